//! Real-time voice mixer living inside the audio output callback.

use crossbeam_channel::Receiver;

use crate::voice::{SampleVoice, ToneVoice};

/// Playback request shipped from the engine façade to the audio callback.
pub enum Command {
    Tone(ToneVoice),
    Sample(SampleVoice),
}

/// Sums every live voice into the output buffer and retires finished ones.
///
/// Voices arrive over a lock-free channel so the game thread never shares a
/// mutex with the callback. Polyphony is unbounded; rate limiting, if any,
/// is the caller's business.
pub struct Mixer {
    commands: Receiver<Command>,
    tones: Vec<ToneVoice>,
    samples: Vec<SampleVoice>,
}

impl Mixer {
    pub fn new(commands: Receiver<Command>) -> Self {
        Self {
            commands,
            tones: Vec::new(),
            samples: Vec::new(),
        }
    }

    /// Number of voices currently sounding.
    pub fn active_voices(&self) -> usize {
        self.tones.len() + self.samples.len()
    }

    /// Fills `output` (interleaved, `channels` slots per frame) with the
    /// mixed signal. Pending spawn requests are drained first so a request
    /// made just before the callback is audible within the same buffer.
    pub fn process(&mut self, output: &mut [f32], channels: usize) {
        self.drain_commands();
        let channels = channels.max(1);
        for frame in output.chunks_mut(channels) {
            let mut mixed = 0.0;
            for voice in &mut self.tones {
                mixed += voice.next_sample();
            }
            for voice in &mut self.samples {
                mixed += voice.next_sample();
            }
            let mixed = mixed.clamp(-1.0, 1.0);
            for slot in frame {
                *slot = mixed;
            }
        }
        self.tones.retain(|voice| !voice.is_finished());
        self.samples.retain(|voice| !voice.is_finished());
    }

    fn drain_commands(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            match command {
                Command::Tone(voice) => self.tones.push(voice),
                Command::Sample(voice) => self.samples.push(voice),
            }
        }
    }
}
