//! The preview event loop: wires winit input into the engine, polls the
//! source watcher through the debouncer, and drives one engine tick per
//! redraw.

use std::fs;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use tracing_subscriber::EnvFilter;
use winit::event::{ElementState, Event, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::EventLoopBuilder;
use winit::keyboard::{Key, NamedKey};

use renderer::snapshot;
use renderer::uniforms::RESOLUTION_UNIFORM;
use renderer::{
    CanvasConfig, CompileOutcome, Debouncer, EngineOptions, FilterMode, InputState,
    ProjectSnapshot, RenderState, Severity, TextureStore, UniformRegistry, ViewportTransform,
};

use crate::cli::Args;
use crate::watch::{ShaderSources, SourceWatcher};
use crate::window::GlWindow;

const WATCH_POLL_INTERVAL: Duration = Duration::from_millis(250);
const WHEEL_ZOOM_STEP: f32 = 0.1;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

pub fn run(args: Args) -> Result<()> {
    let event_loop = EventLoopBuilder::new()
        .build()
        .context("failed to create event loop")?;
    let gl_window = GlWindow::new(&event_loop, args.window)?;

    let filtering: FilterMode = args.filtering.into();
    let mut canvas = CanvasConfig::new(args.canvas.0, args.canvas.1, filtering);
    let options = EngineOptions {
        reset_time_on_compile: args.reset_time_on_compile,
        compile_debounce: Duration::from_millis(args.debounce_ms),
    };

    let mut engine = Some(
        RenderState::new(&gl_window.gl, canvas, options.clone(), Instant::now())
            .map_err(|error| anyhow!("failed to initialise render state: {error}"))?,
    );
    let mut registry = UniformRegistry::with_defaults(canvas.size());
    let mut textures = TextureStore::new();
    let mut input = InputState::new();
    let window_size = gl_window.window.inner_size();
    let mut viewport =
        ViewportTransform::new((window_size.width, window_size.height), canvas.size());

    if let Some(path) = args.project.as_ref().filter(|path| path.exists()) {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read project '{}'", path.display()))?;
        match serde_json::from_str::<ProjectSnapshot>(&text) {
            Ok(parsed) => {
                match snapshot::import(&parsed, &mut registry, &mut viewport, &mut textures) {
                    Ok(imported) => {
                        canvas = imported;
                        if let Some(engine) = engine.as_mut() {
                            engine.set_filtering(canvas.filtering);
                            engine.resize_canvas(&gl_window.gl, canvas.width, canvas.height);
                        }
                        viewport.set_canvas_size(canvas.size());
                        tracing::info!(path = %path.display(), "project snapshot loaded");
                    }
                    Err(error) => {
                        tracing::warn!(error = %error, "ignoring malformed project snapshot")
                    }
                }
            }
            Err(error) => tracing::warn!(error = %error, "project snapshot is not valid JSON"),
        }
    }

    let mut watcher = SourceWatcher::new(args.vertex.clone(), args.fragment.clone());
    let sources = watcher.load()?;
    if let Some(engine) = engine.as_mut() {
        let outcome = engine.compile_and_install(
            &gl_window.gl,
            &sources.vertex,
            &sources.fragment,
            Instant::now(),
        );
        report_outcome(&outcome);
    }

    let mut debouncer: Debouncer<ShaderSources> = Debouncer::new(options.compile_debounce);
    let mut last_watch_poll = Instant::now();
    let mut cursor = (0.0_f32, 0.0_f32);
    let mut panning = false;
    let project_path = args.project.clone();

    event_loop
        .run(move |event, elwt| match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => {
                    if let Some(path) = project_path.as_ref() {
                        let exported = snapshot::export(&registry, &viewport, canvas, &textures);
                        match serde_json::to_string_pretty(&exported) {
                            Ok(text) => match fs::write(path, text) {
                                Ok(()) => {
                                    tracing::info!(path = %path.display(), "project snapshot saved")
                                }
                                Err(error) => {
                                    tracing::error!(error = %error, "failed to write project snapshot")
                                }
                            },
                            Err(error) => {
                                tracing::error!(error = %error, "failed to serialize project snapshot")
                            }
                        }
                    }
                    textures.dispose_all(&gl_window.gl);
                    if let Some(engine) = engine.take() {
                        engine.destroy(&gl_window.gl);
                    }
                    elwt.exit();
                }
                WindowEvent::Resized(new_size) => {
                    gl_window.resize(new_size.width, new_size.height);
                    viewport.set_container_size((new_size.width, new_size.height));
                }
                WindowEvent::CursorMoved { position, .. } => {
                    let (x, y) = (position.x as f32, position.y as f32);
                    if panning && viewport.pan_zoom_enabled() {
                        viewport.apply_pan(x - cursor.0, y - cursor.1);
                    }
                    cursor = (x, y);
                    input.set_cursor_position(x, y);
                }
                WindowEvent::MouseInput { state, button, .. } => {
                    let pressed = state == ElementState::Pressed;
                    input.set_button_pressed(button_index(button), pressed);
                    if button == MouseButton::Left {
                        panning = pressed;
                    }
                }
                WindowEvent::MouseWheel { delta, .. } => {
                    if viewport.pan_zoom_enabled() {
                        let steps = match delta {
                            MouseScrollDelta::LineDelta(_, y) => y,
                            MouseScrollDelta::PixelDelta(position) => position.y as f32 / 40.0,
                        };
                        viewport.apply_zoom(steps * WHEEL_ZOOM_STEP, cursor.0, cursor.1);
                    }
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    let pressed = event.state == ElementState::Pressed;
                    if let Some(code) = ascii_from_key_event(&event) {
                        input.set_key_pressed(u32::from(code), pressed);
                    }
                    if pressed && !event.repeat {
                        handle_hotkey(
                            &event,
                            engine.as_mut(),
                            &mut registry,
                            &mut viewport,
                            &mut canvas,
                            &gl_window,
                        );
                    }
                }
                WindowEvent::RedrawRequested => {
                    let now = Instant::now();
                    if now.saturating_duration_since(last_watch_poll) >= WATCH_POLL_INTERVAL {
                        last_watch_poll = now;
                        match watcher.poll_changed() {
                            Ok(Some(sources)) => debouncer.submit(sources, now),
                            Ok(None) => {}
                            Err(error) => tracing::warn!(error = %error, "source watch failed"),
                        }
                    }
                    let Some(engine) = engine.as_mut() else {
                        return;
                    };
                    if let Some(sources) = debouncer.poll(now) {
                        let outcome = engine.compile_and_install(
                            &gl_window.gl,
                            &sources.vertex,
                            &sources.fragment,
                            now,
                        );
                        report_outcome(&outcome);
                    }

                    let inner = gl_window.window.inner_size();
                    let report = engine.render_frame(
                        &gl_window.gl,
                        &mut registry,
                        &mut textures,
                        &input,
                        &viewport,
                        (inner.width, inner.height),
                        now,
                    );
                    if let Some(fps) = report.fps {
                        tracing::debug!(fps, playing = engine.is_playing(), "render stats");
                    }
                    if let Err(error) = gl_window.swap() {
                        tracing::error!(error = %error, "failed to present frame");
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                gl_window.window.request_redraw();
            }
            _ => {}
        })
        .map_err(|error| anyhow!("window event loop error: {error}"))
}

fn handle_hotkey(
    event: &KeyEvent,
    engine: Option<&mut RenderState>,
    registry: &mut UniformRegistry,
    viewport: &mut ViewportTransform,
    canvas: &mut CanvasConfig,
    gl_window: &GlWindow,
) {
    let Some(engine) = engine else { return };
    match &event.logical_key {
        Key::Named(NamedKey::Space) => {
            let playing = engine.toggle_playback(Instant::now());
            tracing::info!(playing, "animation state");
        }
        Key::Character(text) => match text.as_str() {
            "r" => engine.reset_clock(Instant::now()),
            "v" => {
                viewport.reset();
            }
            "p" => {
                let enabled = !viewport.pan_zoom_enabled();
                viewport.set_pan_zoom_enabled(enabled);
                tracing::info!(enabled, "pan/zoom");
            }
            "f" => {
                // Deliberate canvas resize to the window size: automatic
                // resolution takes over again.
                let inner = gl_window.window.inner_size();
                *canvas = CanvasConfig::new(inner.width, inner.height, canvas.filtering);
                registry.clear_manual_flag(RESOLUTION_UNIFORM);
                engine.resize_canvas(&gl_window.gl, canvas.width, canvas.height);
                viewport.set_canvas_size(canvas.size());
                tracing::info!(width = canvas.width, height = canvas.height, "canvas resized");
            }
            _ => {}
        },
        _ => {}
    }
}

fn report_outcome(outcome: &CompileOutcome) {
    if outcome.success {
        tracing::info!("shader program compiled");
        return;
    }
    for diagnostic in &outcome.diagnostics {
        match diagnostic.severity {
            Severity::Error => tracing::error!(
                stage = %diagnostic.stage,
                line = diagnostic.line,
                column = diagnostic.column,
                "{}",
                diagnostic.message
            ),
            Severity::Warning => tracing::warn!(
                stage = %diagnostic.stage,
                line = diagnostic.line,
                "{}",
                diagnostic.message
            ),
            Severity::Info => tracing::info!(stage = %diagnostic.stage, "{}", diagnostic.message),
        }
    }
}

fn button_index(button: MouseButton) -> u32 {
    match button {
        MouseButton::Left => 0,
        MouseButton::Right => 1,
        MouseButton::Middle => 2,
        MouseButton::Back => 3,
        MouseButton::Forward => 4,
        MouseButton::Other(code) => u32::from(code),
    }
}

/// Keystate uniforms are bound to ASCII codes, so only single ASCII
/// characters and a few named keys map into the tracked code space.
fn ascii_from_key_event(event: &KeyEvent) -> Option<u8> {
    match &event.logical_key {
        Key::Character(text) => {
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(ch), None) if ch.is_ascii() => Some(ch as u8),
                _ => None,
            }
        }
        Key::Named(NamedKey::Space) => Some(b' '),
        Key::Named(NamedKey::Enter) => Some(b'\n'),
        Key::Named(NamedKey::Tab) => Some(b'\t'),
        Key::Named(NamedKey::Escape) => Some(27),
        _ => None,
    }
}
