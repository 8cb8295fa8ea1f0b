use std::path::PathBuf;

use anyhow::{anyhow, Result};
use backdrop::Antialiasing;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "arcfx",
    author,
    version,
    about = "Arcade presentation-layer demo: procedural backdrop plus tone synthesis"
)]
pub struct Cli {
    /// Window size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", default_value = "1280x720")]
    pub size: String,

    /// Anti-aliasing: `auto`, `off`, or an MSAA sample count.
    #[arg(long, value_name = "MODE", default_value = "off", value_parser = parse_antialiasing)]
    pub antialias: Antialiasing,

    /// Master volume in [0,1].
    #[arg(long, value_name = "LEVEL", default_value_t = 0.8)]
    pub master_volume: f32,

    /// Sound-effect volume in [0,1].
    #[arg(long, value_name = "LEVEL", default_value_t = 1.0)]
    pub sfx_volume: f32,

    /// Music volume in [0,1].
    #[arg(long, value_name = "LEVEL", default_value_t = 0.6)]
    pub music_volume: f32,

    /// TOML manifest of sounds to preload (played with the digit keys).
    #[arg(long, value_name = "FILE")]
    pub sounds: Option<PathBuf>,

    /// Start with the master bus muted.
    #[arg(long)]
    pub mute: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}

/// Parses a `WIDTHxHEIGHT` specification into physical pixels.
pub fn parse_surface_size(input: &str) -> Result<(u32, u32)> {
    let (width, height) = input
        .split_once(['x', 'X'])
        .ok_or_else(|| anyhow!("expected WIDTHxHEIGHT, got '{input}'"))?;
    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| anyhow!("invalid width in '{input}'"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| anyhow!("invalid height in '{input}'"))?;
    if width == 0 || height == 0 {
        return Err(anyhow!("surface size must be non-zero, got '{input}'"));
    }
    Ok((width, height))
}

fn parse_antialiasing(input: &str) -> Result<Antialiasing, String> {
    match input {
        "auto" => Ok(Antialiasing::Auto),
        "off" => Ok(Antialiasing::Off),
        samples => samples
            .parse::<u32>()
            .map(Antialiasing::Samples)
            .map_err(|_| format!("expected 'auto', 'off', or a sample count, got '{input}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_defaults() {
        let cli = Cli::try_parse_from(["arcfx"]).expect("defaults parse");
        assert_eq!(cli.size, "1280x720");
        assert_eq!(cli.antialias, Antialiasing::Off);
        assert!(!cli.mute);
        assert!(cli.sounds.is_none());
    }

    #[test]
    fn parses_volume_and_manifest_flags() {
        let cli = Cli::try_parse_from([
            "arcfx",
            "--master-volume",
            "0.5",
            "--sfx-volume",
            "0.25",
            "--sounds",
            "sounds.toml",
            "--antialias",
            "4",
        ])
        .expect("flags parse");
        assert_eq!(cli.master_volume, 0.5);
        assert_eq!(cli.sfx_volume, 0.25);
        assert_eq!(cli.sounds.as_deref(), Some(std::path::Path::new("sounds.toml")));
        assert_eq!(cli.antialias, Antialiasing::Samples(4));
    }

    #[test]
    fn surface_size_parses_and_validates() {
        assert_eq!(parse_surface_size("1920x1080").unwrap(), (1920, 1080));
        assert!(parse_surface_size("1920").is_err());
        assert!(parse_surface_size("0x720").is_err());
        assert!(parse_surface_size("axb").is_err());
    }
}
