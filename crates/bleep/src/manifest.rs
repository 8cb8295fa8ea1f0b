//! TOML manifest listing the sounds an asset collaborator wants preloaded.
//!
//! ```toml
//! version = 1
//!
//! [[sounds]]
//! name = "laser"
//! source = "assets/laser.ogg"
//!
//! [[sounds]]
//! name = "theme"
//! source = "https://example.com/theme.ogg"
//! kind = "music"
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed to read sound manifest: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse sound manifest: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid sound manifest: {0}")]
    Invalid(String),
}

/// Gain bus a sound is routed through when played.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundKind {
    #[default]
    Sfx,
    Music,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SoundManifest {
    pub version: u32,
    #[serde(default)]
    pub sounds: Vec<SoundEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SoundEntry {
    /// Registry key; must be unique within the manifest.
    pub name: String,
    /// Local path or http(s) URL of the encoded audio.
    pub source: String,
    #[serde(default)]
    pub kind: SoundKind,
}

impl SoundManifest {
    pub fn parse(text: &str) -> Result<Self, ManifestError> {
        let manifest: Self = toml::from_str(text)?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        Self::parse(&std::fs::read_to_string(path)?)
    }

    fn validate(&self) -> Result<(), ManifestError> {
        let mut seen = HashSet::new();
        for entry in &self.sounds {
            if entry.name.is_empty() {
                return Err(ManifestError::Invalid(
                    "sound name must not be empty".into(),
                ));
            }
            if entry.source.is_empty() {
                return Err(ManifestError::Invalid(format!(
                    "sound '{}' has an empty source",
                    entry.name
                )));
            }
            if !seen.insert(entry.name.as_str()) {
                return Err(ManifestError::Invalid(format!(
                    "duplicate sound name '{}'",
                    entry.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_minimal_manifest_with_default_kind() {
        let manifest = SoundManifest::parse(
            r#"
version = 1

[[sounds]]
name = "laser"
source = "assets/laser.ogg"
"#,
        )
        .expect("parse manifest");
        assert_eq!(manifest.sounds.len(), 1);
        assert_eq!(manifest.sounds[0].name, "laser");
        assert_eq!(manifest.sounds[0].kind, SoundKind::Sfx);
    }

    #[test]
    fn parses_music_kind() {
        let manifest = SoundManifest::parse(
            r#"
version = 1

[[sounds]]
name = "theme"
source = "https://example.com/theme.ogg"
kind = "music"
"#,
        )
        .expect("parse manifest");
        assert_eq!(manifest.sounds[0].kind, SoundKind::Music);
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = SoundManifest::parse(
            r#"
version = 1

[[sounds]]
name = "laser"
source = "a.ogg"

[[sounds]]
name = "laser"
source = "b.ogg"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ManifestError::Invalid(_)));
    }

    #[test]
    fn rejects_empty_name() {
        let err = SoundManifest::parse(
            r#"
version = 1

[[sounds]]
name = ""
source = "a.ogg"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ManifestError::Invalid(_)));
    }

    #[test]
    fn loads_manifest_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
version = 1

[[sounds]]
name = "impact"
source = "impact.wav"
"#
        )
        .unwrap();

        let manifest = SoundManifest::load(file.path()).expect("load manifest");
        assert_eq!(manifest.sounds[0].name, "impact");
    }
}
