//! Named registry of decoded sounds, populated by background loaders.
//!
//! `load` hides the difference between local files and http(s) URLs from
//! the rest of the engine: a detached thread fetches and decodes the
//! source, then registers the result. A failed load is logged and leaves
//! the registry untouched, so playing that name stays a silent no-op.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::thread;

use anyhow::{Context, Result};
use rodio::Source;
use tracing::{debug, warn};

use crate::manifest::SoundKind;

/// Decoded audio ready for mixing: mono f32 samples at the source rate.
#[derive(Debug, Clone)]
pub struct SoundData {
    pub sample_rate: u32,
    pub samples: Vec<f32>,
    pub kind: SoundKind,
}

impl SoundData {
    pub fn duration_seconds(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate.max(1) as f32
    }
}

/// Registry mapping sound names to decoded buffers.
///
/// Entries appear asynchronously as loader threads finish; a second load
/// for the same name replaces the previous entry. Lookup of a missing name
/// is not an error.
#[derive(Clone, Default)]
pub struct SoundBank {
    entries: Arc<Mutex<HashMap<String, Arc<SoundData>>>>,
}

impl SoundBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Arc<SoundData>> {
        self.entries.lock().ok()?.get(name).cloned()
    }

    pub fn insert(&self, name: impl Into<String>, data: SoundData) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(name.into(), Arc::new(data));
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetches and decodes `source` on a background thread, registering it
    /// under `name` on success.
    pub fn load(&self, name: &str, source: &str, kind: SoundKind) {
        let bank = self.clone();
        let name = name.to_string();
        let source = source.to_string();
        let builder = thread::Builder::new().name(format!("sound-load-{name}"));
        let spawned = builder.spawn(move || {
            if let Err(err) = bank.load_blocking(&name, &source, kind) {
                warn!(
                    sound = %name,
                    source = %source,
                    error = %err,
                    "failed to load sound; name left unregistered"
                );
            }
        });
        if let Err(err) = spawned {
            warn!(error = %err, "failed to spawn sound loader thread");
        }
    }

    /// Synchronous body of [`SoundBank::load`], exposed for tests.
    pub(crate) fn load_blocking(&self, name: &str, source: &str, kind: SoundKind) -> Result<()> {
        let bytes = fetch_source(source)?;
        let data = decode_bytes(bytes, kind)?;
        debug!(
            sound = %name,
            samples = data.samples.len(),
            sample_rate = data.sample_rate,
            "registered sound"
        );
        self.insert(name, data);
        Ok(())
    }
}

/// Reads the raw bytes behind a sound source: local path or http(s) URL.
fn fetch_source(source: &str) -> Result<Vec<u8>> {
    if source.starts_with("http://") || source.starts_with("https://") {
        let response = reqwest::blocking::get(source)
            .with_context(|| format!("failed to fetch {source}"))?
            .error_for_status()
            .with_context(|| format!("server rejected {source}"))?;
        let bytes = response
            .bytes()
            .with_context(|| format!("failed to read body of {source}"))?;
        Ok(bytes.to_vec())
    } else {
        std::fs::read(source).with_context(|| format!("failed to read {source}"))
    }
}

/// Decodes an encoded payload and downmixes it to mono f32.
fn decode_bytes(bytes: Vec<u8>, kind: SoundKind) -> Result<SoundData> {
    let decoder = rodio::Decoder::new(Cursor::new(bytes)).context("unrecognised audio format")?;
    let channels = decoder.channels().max(1) as usize;
    let sample_rate = decoder.sample_rate();
    let raw: Vec<i16> = decoder.collect();

    let mut samples = Vec::with_capacity(raw.len() / channels);
    for frame in raw.chunks_exact(channels) {
        let sum: f32 = frame.iter().map(|&s| s as f32 / i16::MAX as f32).sum();
        samples.push(sum / channels as f32);
    }

    Ok(SoundData {
        sample_rate,
        samples,
        kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// Builds a minimal 16-bit PCM WAV payload from interleaved samples.
    fn wav_bytes(channels: u16, sample_rate: u32, frames: &[i16]) -> Vec<u8> {
        let data_len = (frames.len() * 2) as u32;
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16_u32.to_le_bytes());
        out.extend_from_slice(&1_u16.to_le_bytes());
        out.extend_from_slice(&channels.to_le_bytes());
        out.extend_from_slice(&sample_rate.to_le_bytes());
        out.extend_from_slice(&(sample_rate * channels as u32 * 2).to_le_bytes());
        out.extend_from_slice(&(channels * 2).to_le_bytes());
        out.extend_from_slice(&16_u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        for sample in frames {
            out.extend_from_slice(&sample.to_le_bytes());
        }
        out
    }

    #[test]
    fn missing_name_resolves_to_none() {
        let bank = SoundBank::new();
        assert!(bank.get("missing").is_none());
        assert!(bank.is_empty());
    }

    #[test]
    fn insert_then_get_roundtrips() {
        let bank = SoundBank::new();
        bank.insert(
            "beep",
            SoundData {
                sample_rate: 44_100,
                samples: vec![0.0; 441],
                kind: SoundKind::Sfx,
            },
        );
        let data = bank.get("beep").expect("registered sound");
        assert_eq!(data.samples.len(), 441);
        assert!((data.duration_seconds() - 0.01).abs() < 1e-6);
    }

    #[test]
    fn second_load_replaces_the_entry() {
        let bank = SoundBank::new();
        let data = |n| SoundData {
            sample_rate: 44_100,
            samples: vec![0.0; n],
            kind: SoundKind::Sfx,
        };
        bank.insert("beep", data(10));
        bank.insert("beep", data(20));
        assert_eq!(bank.len(), 1);
        assert_eq!(bank.get("beep").unwrap().samples.len(), 20);
    }

    #[test]
    fn decodes_mono_wav() {
        let bytes = wav_bytes(1, 22_050, &[0, 16_384, -16_384]);
        let data = decode_bytes(bytes, SoundKind::Sfx).expect("decode wav");
        assert_eq!(data.sample_rate, 22_050);
        assert_eq!(data.samples.len(), 3);
        assert!((data.samples[1] - 16_384.0 / i16::MAX as f32).abs() < 1e-4);
    }

    #[test]
    fn downmixes_stereo_to_mono() {
        let bytes = wav_bytes(2, 44_100, &[1000, 3000, -2000, -4000]);
        let data = decode_bytes(bytes, SoundKind::Sfx).expect("decode wav");
        assert_eq!(data.samples.len(), 2);
        assert!((data.samples[0] - 2000.0 / i16::MAX as f32).abs() < 1e-4);
        assert!((data.samples[1] + 3000.0 / i16::MAX as f32).abs() < 1e-4);
    }

    #[test]
    fn load_blocking_registers_a_wav_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&wav_bytes(1, 44_100, &[100, 200, 300]))
            .unwrap();

        let bank = SoundBank::new();
        bank.load_blocking("pickup", file.path().to_str().unwrap(), SoundKind::Sfx)
            .expect("load wav");
        assert_eq!(bank.get("pickup").unwrap().samples.len(), 3);
    }

    #[test]
    fn failed_load_leaves_registry_unchanged() {
        let bank = SoundBank::new();
        let err = bank.load_blocking("ghost", "/no/such/file.wav", SoundKind::Sfx);
        assert!(err.is_err());
        assert!(bank.get("ghost").is_none());
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = decode_bytes(vec![1, 2, 3, 4], SoundKind::Sfx);
        assert!(err.is_err());
    }
}
