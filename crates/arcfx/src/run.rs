//! Stand-in for the external game loop: a winit window driving the backdrop
//! once per frame and mapping input events to tone-engine calls.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use tracing_subscriber::EnvFilter;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, MouseButton, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::Key;
use winit::window::WindowBuilder;

use backdrop::{Backdrop, BackdropConfig, Palette, SurfaceError};
use bleep::{SoundManifest, ToneEngine, Waveform};

use crate::cli::{parse_surface_size, Cli};

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

pub fn run(cli: Cli) -> Result<()> {
    let (width, height) = parse_surface_size(&cli.size)?;

    let event_loop = EventLoop::new().context("failed to initialize event loop")?;
    let window = WindowBuilder::new()
        .with_title("arcfx")
        .with_inner_size(PhysicalSize::new(width, height))
        .build(&event_loop)
        .context("failed to create window")?;
    let window = Arc::new(window);

    let config = BackdropConfig {
        surface_size: (width, height),
        palette: Palette::default(),
        antialiasing: cli.antialias,
    };
    let mut backdrop =
        Backdrop::new(window.as_ref(), &config).context("failed to initialise backdrop renderer")?;

    let mut engine = ToneEngine::new().context("failed to initialise tone engine")?;
    let volumes = engine.volumes_mut();
    volumes.set_master(if cli.mute { 0.0 } else { cli.master_volume });
    volumes.set_sfx(cli.sfx_volume);
    volumes.set_music(cli.music_volume);

    let mut manifest_names: Vec<String> = Vec::new();
    if let Some(path) = cli.sounds.as_ref() {
        let manifest = SoundManifest::load(path)
            .with_context(|| format!("failed to load sound manifest {}", path.display()))?;
        for entry in &manifest.sounds {
            engine.load_sound(&entry.name, &entry.source, entry.kind);
            manifest_names.push(entry.name.clone());
        }
        tracing::info!(count = manifest_names.len(), "preloading manifest sounds");
    }

    let mut last_frame = Instant::now();

    event_loop
        .run(move |event, elwt| {
            // Drive redraws via vblank by waiting between events.
            elwt.set_control_flow(ControlFlow::Wait);

            match event {
                Event::WindowEvent { window_id, event } if window_id == window.id() => {
                    match event {
                        WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                            elwt.exit();
                        }
                        WindowEvent::CursorMoved { position, .. } => {
                            let size = backdrop.size();
                            // Normalize to [0,1] with a bottom-left origin to
                            // match the shader's uv space.
                            backdrop.set_pointer(
                                position.x as f32 / size.width.max(1) as f32,
                                1.0 - position.y as f32 / size.height.max(1) as f32,
                            );
                        }
                        WindowEvent::MouseInput {
                            state: ElementState::Pressed,
                            button,
                            ..
                        } => {
                            unlock_audio(&mut engine);
                            match button {
                                MouseButton::Left => {
                                    engine.play_tone(880.0, Waveform::Sawtooth, 0.15)
                                }
                                MouseButton::Right => {
                                    engine.play_tone(110.0, Waveform::Square, 0.3)
                                }
                                _ => {}
                            }
                        }
                        WindowEvent::KeyboardInput {
                            event: key_event, ..
                        } => {
                            if key_event.state == ElementState::Pressed && !key_event.repeat {
                                unlock_audio(&mut engine);
                                handle_key(&engine, &manifest_names, &key_event.logical_key);
                            }
                        }
                        WindowEvent::Resized(new_size) => {
                            backdrop.resize(new_size);
                        }
                        WindowEvent::ScaleFactorChanged {
                            mut inner_size_writer,
                            ..
                        } => {
                            // Keep the current logical size when the scale factor changes.
                            let _ = inner_size_writer.request_inner_size(backdrop.size());
                        }
                        WindowEvent::RedrawRequested => {
                            let now = Instant::now();
                            let dt = now.duration_since(last_frame).as_secs_f32();
                            last_frame = now;
                            backdrop.update(dt);
                            match backdrop.render() {
                                Ok(()) => {}
                                Err(SurfaceError::Lost | SurfaceError::Outdated) => {
                                    backdrop.resize(backdrop.size());
                                }
                                Err(SurfaceError::OutOfMemory) => {
                                    tracing::error!("surface out of memory; exiting");
                                    elwt.exit();
                                }
                                Err(other) => {
                                    tracing::warn!(
                                        error = ?other,
                                        "surface error; retrying next frame"
                                    );
                                }
                            }
                        }
                        _ => {}
                    }
                }
                Event::AboutToWait => {
                    // Schedule the next frame once winit is about to wait for events again.
                    window.request_redraw();
                }
                _ => {}
            }
        })
        .map_err(|err| anyhow!("event loop error: {err}"))
}

fn unlock_audio(engine: &mut ToneEngine) {
    if let Err(err) = engine.unlock() {
        tracing::warn!(error = %err, "failed to unlock audio output");
    }
}

/// Maps the demo key bindings onto tone-engine calls: z/x/c/v play the four
/// waveforms, digits play manifest sounds in declaration order.
fn handle_key(engine: &ToneEngine, manifest_names: &[String], key: &Key) {
    let Key::Character(text) = key else {
        return;
    };
    match text.as_str() {
        "z" => engine.play_tone(880.0, Waveform::Sawtooth, 0.15),
        "x" => engine.play_tone(110.0, Waveform::Square, 0.3),
        "c" => engine.play_tone(440.0, Waveform::Sine, 0.2),
        "v" => engine.play_tone(660.0, Waveform::Triangle, 0.2),
        digit => {
            let index = digit.chars().next().and_then(|c| c.to_digit(10));
            if let Some(index) = index.filter(|&index| index >= 1) {
                if let Some(name) = manifest_names.get(index as usize - 1) {
                    engine.play_sound(name);
                }
            }
        }
    }
}
