//! Engine façade: output stream lifecycle, volume buses, and playback calls.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, info, warn};

use crate::bank::SoundBank;
use crate::manifest::SoundKind;
use crate::mixer::{Command, Mixer};
use crate::voice::{SampleVoice, ToneVoice, Waveform};

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("no audio output device available")]
    NoDevice,
    #[error("failed to query output configuration: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),
    #[error("unsupported output sample format {0:?}")]
    UnsupportedFormat(cpal::SampleFormat),
    #[error("failed to build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),
    #[error("failed to start output stream: {0}")]
    StartStream(#[from] cpal::PlayStreamError),
}

/// Per-bus volume levels, each kept in [0,1] by the setters.
///
/// Owned by the engine instance rather than living in process-global state,
/// so independent engines (tests included) cannot interfere. Levels are read
/// fresh at every playback call: changing one affects the next sound, never
/// a voice that is already running.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Volumes {
    master: f32,
    music: f32,
    sfx: f32,
}

impl Default for Volumes {
    fn default() -> Self {
        Self {
            master: 1.0,
            music: 1.0,
            sfx: 1.0,
        }
    }
}

impl Volumes {
    pub fn master(&self) -> f32 {
        self.master
    }

    pub fn music(&self) -> f32 {
        self.music
    }

    pub fn sfx(&self) -> f32 {
        self.sfx
    }

    pub fn set_master(&mut self, level: f32) {
        self.master = level.clamp(0.0, 1.0);
    }

    pub fn set_music(&mut self, level: f32) {
        self.music = level.clamp(0.0, 1.0);
    }

    pub fn set_sfx(&mut self, level: f32) {
        self.sfx = level.clamp(0.0, 1.0);
    }

    /// Effective gain for a sound routed through the given bus.
    pub fn bus_gain(&self, kind: SoundKind) -> f32 {
        match kind {
            SoundKind::Sfx => self.sfx * self.master,
            SoundKind::Music => self.music * self.master,
        }
    }
}

/// Whether a user gesture has started the output stream yet.
///
/// The engine begins locked and transitions exactly once; the transition
/// consumes the mixer inbox, so there is nothing to re-register or undo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnlockState {
    Locked,
    Unlocked,
}

/// Procedural sound effect engine.
///
/// Synthesizes short tones (oscillator behind an exponential-decay gain
/// envelope) and plays named pre-decoded buffers. All playback calls are
/// synchronous and non-blocking: they bake the current bus gain into a
/// fresh disposable voice and hand it to the audio callback over a channel.
pub struct ToneEngine {
    device: cpal::Device,
    config: cpal::SupportedStreamConfig,
    state: UnlockState,
    /// Output stream; kept alive so the mixer callback keeps running.
    _stream: Option<cpal::Stream>,
    commands: Sender<Command>,
    /// Receiver handed to the mixer when the stream starts.
    inbox: Option<Receiver<Command>>,
    volumes: Volumes,
    bank: SoundBank,
}

impl ToneEngine {
    /// Resolves the default output device and stream configuration.
    ///
    /// No stream exists yet: the engine starts locked and stays silent until
    /// [`ToneEngine::unlock`] runs. A missing device or configuration is
    /// fatal to the component; the bootstrap decides what to do about it.
    pub fn new() -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;
        let config = device.default_output_config()?;
        info!(
            device = %device.name().unwrap_or_else(|_| "<unknown>".into()),
            sample_rate = config.sample_rate().0,
            channels = config.channels(),
            format = ?config.sample_format(),
            "resolved audio output"
        );

        let (commands, inbox) = unbounded();
        Ok(Self {
            device,
            config,
            state: UnlockState::Locked,
            _stream: None,
            commands,
            inbox: Some(inbox),
            volumes: Volumes::default(),
            bank: SoundBank::new(),
        })
    }

    /// Starts the output stream on the first call; later calls are no-ops.
    ///
    /// Wire this to the first user pointer or keyboard event. Playback
    /// requests made while still locked are accepted but dropped, so game
    /// code never has to track the unlock state itself.
    pub fn unlock(&mut self) -> Result<(), AudioError> {
        if self.state == UnlockState::Unlocked {
            return Ok(());
        }
        let inbox = match self.inbox.take() {
            Some(inbox) => inbox,
            None => return Ok(()),
        };
        let stream = self.build_stream(inbox)?;
        stream.play()?;
        self._stream = Some(stream);
        self.state = UnlockState::Unlocked;
        info!("audio output unlocked");
        Ok(())
    }

    pub fn is_unlocked(&self) -> bool {
        self.state == UnlockState::Unlocked
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate().0
    }

    /// Registry of decoded sounds, shared with loader threads.
    pub fn bank(&self) -> &SoundBank {
        &self.bank
    }

    pub fn volumes(&self) -> Volumes {
        self.volumes
    }

    pub fn volumes_mut(&mut self) -> &mut Volumes {
        &mut self.volumes
    }

    /// Begins fetching and decoding `source`, registering it under `name`.
    ///
    /// Returns immediately; a failure is logged by the loader and leaves
    /// `name` unregistered, keeping [`ToneEngine::play_sound`] a no-op.
    pub fn load_sound(&self, name: &str, source: &str, kind: SoundKind) {
        self.bank.load(name, source, kind);
    }

    /// Synthesizes one tone of the given waveform, frequency, and duration.
    ///
    /// Every call creates a fresh disposable voice; concurrent calls overlap
    /// freely. Onset is at `sfx x master` gain with exponential decay toward
    /// a near-zero floor, and the oscillator stops exactly `duration`
    /// seconds after it starts.
    pub fn play_tone(&self, frequency: f32, waveform: Waveform, duration: f32) {
        if self.state == UnlockState::Locked {
            debug!(frequency, "tone requested before audio unlock; dropped");
            return;
        }
        let gain = self.volumes.bus_gain(SoundKind::Sfx);
        let voice = ToneVoice::new(frequency, waveform, duration, gain, self.sample_rate());
        let _ = self.commands.send(Command::Tone(voice));
    }

    /// Plays a previously loaded sound; unknown names are a silent no-op so
    /// callers may fire before assets finish loading.
    pub fn play_sound(&self, name: &str) {
        if self.state == UnlockState::Locked {
            debug!(sound = %name, "sound requested before audio unlock; dropped");
            return;
        }
        let Some(data) = self.bank.get(name) else {
            debug!(sound = %name, "sound not loaded yet; skipped");
            return;
        };
        let gain = self.volumes.bus_gain(data.kind);
        let voice = SampleVoice::new(data, gain, self.sample_rate());
        let _ = self.commands.send(Command::Sample(voice));
    }

    fn build_stream(&self, inbox: Receiver<Command>) -> Result<cpal::Stream, AudioError> {
        let stream_config: cpal::StreamConfig = self.config.config();
        match self.config.sample_format() {
            cpal::SampleFormat::F32 => self.build_stream_for::<f32>(&stream_config, inbox),
            cpal::SampleFormat::I16 => self.build_stream_for::<i16>(&stream_config, inbox),
            cpal::SampleFormat::U16 => self.build_stream_for::<u16>(&stream_config, inbox),
            other => Err(AudioError::UnsupportedFormat(other)),
        }
    }

    fn build_stream_for<T>(
        &self,
        config: &cpal::StreamConfig,
        inbox: Receiver<Command>,
    ) -> Result<cpal::Stream, AudioError>
    where
        T: cpal::SizedSample + cpal::FromSample<f32>,
    {
        let channels = config.channels as usize;
        let mut mixer = Mixer::new(inbox);
        let mut scratch: Vec<f32> = Vec::new();
        let stream = self.device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                scratch.resize(data.len(), 0.0);
                mixer.process(&mut scratch, channels);
                for (slot, &sample) in data.iter_mut().zip(scratch.iter()) {
                    *slot = T::from_sample(sample);
                }
            },
            |err| warn!(error = %err, "audio output stream error"),
            None,
        )?;
        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_setters_clamp_to_unit_range() {
        let mut volumes = Volumes::default();
        volumes.set_master(1.8);
        volumes.set_sfx(-0.3);
        volumes.set_music(0.4);
        assert_eq!(volumes.master(), 1.0);
        assert_eq!(volumes.sfx(), 0.0);
        assert_eq!(volumes.music(), 0.4);
    }

    #[test]
    fn bus_gain_multiplies_master_with_the_bus_level() {
        let mut volumes = Volumes::default();
        volumes.set_master(0.5);
        volumes.set_sfx(0.8);
        volumes.set_music(0.2);
        assert!((volumes.bus_gain(SoundKind::Sfx) - 0.4).abs() < 1e-6);
        assert!((volumes.bus_gain(SoundKind::Music) - 0.1).abs() < 1e-6);
    }
}
