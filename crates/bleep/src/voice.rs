//! Disposable synthesis voices consumed by the mixer.
//!
//! Every playback request becomes one value-semantics voice: created on the
//! caller's thread with its gain baked in, shipped to the audio callback
//! over a channel, pulled for samples until it reports finished, then
//! dropped. No pooling, no reuse.

use std::sync::Arc;

use crate::bank::SoundData;

/// Envelope floor the exponential decay aims at; never reaches zero.
const ENVELOPE_FLOOR: f32 = 1e-4;

/// Oscillator shape for synthesized tones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl Waveform {
    /// Samples the waveform at `phase` in [0,1) cycles, range [-1,1].
    fn sample(self, phase: f32) -> f32 {
        match self {
            Self::Sine => (phase * std::f32::consts::TAU).sin(),
            Self::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Self::Sawtooth => 2.0 * phase - 1.0,
            Self::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
        }
    }
}

/// A single synthesized tone: one oscillator behind an exponential-decay
/// gain envelope, scheduled to stop a fixed number of samples after start.
pub struct ToneVoice {
    waveform: Waveform,
    phase: f32,
    phase_step: f32,
    envelope: f32,
    decay: f32,
    gain: f32,
    remaining: u64,
}

impl ToneVoice {
    /// Builds a voice stopping exactly `duration` seconds after its start.
    ///
    /// `gain` is the bus level sampled at the call instant; volume changes
    /// made later never reach a voice that is already running. Non-positive
    /// frequency or duration produce a degenerate but harmless voice.
    pub fn new(
        frequency: f32,
        waveform: Waveform,
        duration: f32,
        gain: f32,
        sample_rate: u32,
    ) -> Self {
        let sample_rate = sample_rate.max(1) as f32;
        let total = (duration.max(0.0) * sample_rate).ceil().max(1.0);
        Self {
            waveform,
            phase: 0.0,
            phase_step: frequency.max(0.0) / sample_rate,
            envelope: 1.0,
            decay: ENVELOPE_FLOOR.powf(1.0 / total),
            gain,
            remaining: total as u64,
        }
    }

    /// True once the scheduled stop time has passed.
    pub fn is_finished(&self) -> bool {
        self.remaining == 0
    }

    /// Produces the next mono sample; silence once the voice has stopped.
    pub fn next_sample(&mut self) -> f32 {
        if self.remaining == 0 {
            return 0.0;
        }
        let value = self.waveform.sample(self.phase) * self.envelope * self.gain;
        self.phase += self.phase_step;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }
        self.envelope *= self.decay;
        self.remaining -= 1;
        value
    }
}

/// Plays one decoded buffer back, linearly resampled to the output rate.
pub struct SampleVoice {
    data: Arc<SoundData>,
    cursor: f32,
    step: f32,
    gain: f32,
}

impl SampleVoice {
    pub fn new(data: Arc<SoundData>, gain: f32, output_rate: u32) -> Self {
        let step = data.sample_rate as f32 / output_rate.max(1) as f32;
        Self {
            data,
            cursor: 0.0,
            step,
            gain,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.cursor as usize >= self.data.samples.len()
    }

    pub fn next_sample(&mut self) -> f32 {
        let samples = &self.data.samples;
        let index = self.cursor as usize;
        if index >= samples.len() {
            return 0.0;
        }
        let next = samples.get(index + 1).copied().unwrap_or(samples[index]);
        let frac = self.cursor - index as f32;
        let value = samples[index] + (next - samples[index]) * frac;
        self.cursor += self.step;
        value * self.gain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::SoundKind;

    const SAMPLE_RATE: u32 = 44_100;

    #[test]
    fn waveforms_cover_expected_shapes() {
        assert!(Waveform::Sine.sample(0.0).abs() < 1e-6);
        assert!((Waveform::Sine.sample(0.25) - 1.0).abs() < 1e-5);
        assert_eq!(Waveform::Square.sample(0.1), 1.0);
        assert_eq!(Waveform::Square.sample(0.9), -1.0);
        assert!((Waveform::Sawtooth.sample(0.0) + 1.0).abs() < 1e-6);
        assert!((Waveform::Sawtooth.sample(0.75) - 0.5).abs() < 1e-6);
        assert!((Waveform::Triangle.sample(0.5) - 1.0).abs() < 1e-6);
        assert!((Waveform::Triangle.sample(0.0) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn tone_stops_exactly_at_scheduled_duration() {
        let mut voice = ToneVoice::new(440.0, Waveform::Sine, 0.1, 1.0, SAMPLE_RATE);
        for _ in 0..4409 {
            voice.next_sample();
        }
        assert!(!voice.is_finished());
        voice.next_sample();
        assert!(voice.is_finished());
        assert_eq!(voice.next_sample(), 0.0);
    }

    #[test]
    fn envelope_decays_monotonically_and_never_reaches_zero() {
        // Zero frequency pins the square oscillator at +1 so the samples
        // trace the raw envelope.
        let mut voice = ToneVoice::new(0.0, Waveform::Square, 0.01, 1.0, SAMPLE_RATE);
        let mut previous = f32::INFINITY;
        let mut last = 0.0;
        while !voice.is_finished() {
            let sample = voice.next_sample();
            assert!(sample > 0.0);
            assert!(sample < previous);
            previous = sample;
            last = sample;
        }
        assert!(last > 0.0);
    }

    #[test]
    fn gain_is_baked_at_construction() {
        let mut loud = ToneVoice::new(0.0, Waveform::Square, 0.01, 0.8, SAMPLE_RATE);
        let mut quiet = ToneVoice::new(0.0, Waveform::Square, 0.01, 0.2, SAMPLE_RATE);
        assert!((loud.next_sample() - 0.8).abs() < 1e-6);
        assert!((quiet.next_sample() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn concurrent_voices_end_independently() {
        let mut short = ToneVoice::new(220.0, Waveform::Sine, 0.01, 1.0, SAMPLE_RATE);
        let mut long = ToneVoice::new(220.0, Waveform::Sine, 0.02, 1.0, SAMPLE_RATE);
        for _ in 0..441 {
            short.next_sample();
            long.next_sample();
        }
        assert!(short.is_finished());
        assert!(!long.is_finished());
    }

    #[test]
    fn degenerate_duration_still_terminates() {
        let mut voice = ToneVoice::new(440.0, Waveform::Sine, 0.0, 1.0, SAMPLE_RATE);
        voice.next_sample();
        assert!(voice.is_finished());
    }

    fn constant_data(samples: Vec<f32>, sample_rate: u32) -> Arc<SoundData> {
        Arc::new(SoundData {
            sample_rate,
            samples,
            kind: SoundKind::Sfx,
        })
    }

    #[test]
    fn sample_voice_plays_buffer_at_matching_rate() {
        let data = constant_data(vec![1.0; 4], SAMPLE_RATE);
        let mut voice = SampleVoice::new(data, 0.5, SAMPLE_RATE);
        for _ in 0..4 {
            assert!((voice.next_sample() - 0.5).abs() < 1e-6);
        }
        assert!(voice.is_finished());
        assert_eq!(voice.next_sample(), 0.0);
    }

    #[test]
    fn sample_voice_resamples_to_output_rate() {
        // Half the source rate: each source sample spans two output frames.
        let data = constant_data(vec![1.0; 4], SAMPLE_RATE / 2);
        let mut voice = SampleVoice::new(data, 1.0, SAMPLE_RATE);
        let mut produced = 0;
        while !voice.is_finished() {
            voice.next_sample();
            produced += 1;
        }
        assert_eq!(produced, 8);
    }
}
