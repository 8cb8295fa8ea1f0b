//! Tone synthesis engine for the arcfx presentation layer.
//!
//! Generates short arcade sound effects procedurally — one oscillator
//! behind an exponential-decay gain envelope per request, no pre-recorded
//! assets — and plays named pre-decoded buffers loaded in the background.
//! The flow from a gameplay event to the speaker:
//!
//! ```text
//!   game code ──▶ ToneEngine::play_tone / play_sound
//!                        │  (bakes current bus gain into a fresh voice)
//!                        ▼
//!                crossbeam channel ──▶ Mixer (cpal callback) ──▶ device
//!                        ▲
//!   loader threads ──▶ SoundBank (decode via rodio, file or http source)
//! ```
//!
//! The engine starts locked: nothing is audible until the first user
//! gesture calls [`ToneEngine::unlock`], which builds and starts the output
//! stream exactly once. Requests made earlier are accepted and dropped.

mod bank;
mod engine;
mod manifest;
mod mixer;
mod voice;

pub use bank::{SoundBank, SoundData};
pub use engine::{AudioError, ToneEngine, Volumes};
pub use manifest::{ManifestError, SoundEntry, SoundKind, SoundManifest};
pub use mixer::{Command, Mixer};
pub use voice::{SampleVoice, ToneVoice, Waveform};
