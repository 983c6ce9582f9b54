//! Per-frame render state and the tick sequence.
//!
//! `RenderState` owns every GPU object with engine lifetime: the current
//! program, the uniform-location cache, the fullscreen-triangle VAO, the
//! canvas target and the feedback generation. A tick advances the clock,
//! resolves builtins, binds uniforms (texture uniforms get monotonically
//! increasing units in registry order), draws, captures the feedback frame
//! and presents the canvas through the viewport transform.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use glow::HasContext;
use tracing::{debug, warn};

use crate::clock::AnimationClock;
use crate::diagnostics::Diagnostic;
use crate::input::InputState;
use crate::types::{CanvasConfig, EngineOptions, FilterMode};
use crate::uniforms::{BuiltinContext, UniformRegistry, UniformUpdate, UniformValue};
use crate::viewport::ViewportTransform;

use super::compile::compile_program;
use super::feedback::FeedbackBuffer;
use super::target::CanvasTarget;
use super::texture::TextureStore;
use super::OffscreenError;

const FPS_WINDOW: usize = 60;
const FPS_REFRESH: Duration = Duration::from_millis(500);

/// Compile-result notification for collaborators.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileOutcome {
    pub success: bool,
    pub diagnostics: Vec<Diagnostic>,
}

/// Per-frame outputs for collaborators: builtin values that changed and, at
/// most twice a second, a fresh FPS sample.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub updates: Vec<UniformUpdate>,
    pub fps: Option<u32>,
}

/// Rolling average over the last [`FPS_WINDOW`] frame times, surfaced at
/// most every [`FPS_REFRESH`].
#[derive(Debug)]
struct FpsCounter {
    samples: [f32; FPS_WINDOW],
    len: usize,
    head: usize,
    last_frame: Option<Instant>,
    last_refresh: Option<Instant>,
}

impl FpsCounter {
    fn new() -> Self {
        Self {
            samples: [0.0; FPS_WINDOW],
            len: 0,
            head: 0,
            last_frame: None,
            last_refresh: None,
        }
    }

    fn tick(&mut self, now: Instant) -> Option<u32> {
        if let Some(previous) = self.last_frame.replace(now) {
            let delta = now.saturating_duration_since(previous).as_secs_f32();
            if delta > 0.0 {
                self.samples[self.head] = delta;
                self.head = (self.head + 1) % FPS_WINDOW;
                self.len = (self.len + 1).min(FPS_WINDOW);
            }
        }
        if self.len == 0 {
            return None;
        }
        let refresh_due = self
            .last_refresh
            .is_none_or(|last| now.saturating_duration_since(last) >= FPS_REFRESH);
        if !refresh_due {
            return None;
        }
        self.last_refresh = Some(now);
        let mean: f32 = self.samples[..self.len].iter().sum::<f32>() / self.len as f32;
        Some((1.0 / mean).round() as u32)
    }
}

pub struct RenderState {
    program: Option<glow::Program>,
    locations: HashMap<String, Option<glow::UniformLocation>>,
    vertex_array: glow::VertexArray,
    canvas: Option<CanvasTarget>,
    feedback: Option<FeedbackBuffer>,
    canvas_size: (u32, u32),
    filtering: FilterMode,
    clock: AnimationClock,
    fps: FpsCounter,
    options: EngineOptions,
}

impl RenderState {
    pub fn new(
        gl: &glow::Context,
        canvas: CanvasConfig,
        options: EngineOptions,
        now: Instant,
    ) -> Result<Self, OffscreenError> {
        let vertex_array = unsafe { gl.create_vertex_array().map_err(OffscreenError::Create)? };
        let target = CanvasTarget::create(gl, canvas.width, canvas.height)?;
        let feedback = match FeedbackBuffer::create(gl, canvas.width, canvas.height) {
            Ok(feedback) => Some(feedback),
            Err(error) => {
                warn!(error = %error, "feedback buffer unavailable; u_lastFrame disabled");
                None
            }
        };
        Ok(Self {
            program: None,
            locations: HashMap::new(),
            vertex_array,
            canvas: Some(target),
            feedback,
            canvas_size: canvas.size(),
            filtering: canvas.filtering,
            clock: AnimationClock::new(now),
            fps: FpsCounter::new(),
            options,
        })
    }

    pub fn canvas_size(&self) -> (u32, u32) {
        self.canvas_size
    }

    pub fn filtering(&self) -> FilterMode {
        self.filtering
    }

    pub fn set_filtering(&mut self, filtering: FilterMode) {
        self.filtering = filtering;
    }

    pub fn has_program(&self) -> bool {
        self.program.is_some()
    }

    pub fn is_playing(&self) -> bool {
        self.clock.is_playing()
    }

    pub fn pause(&mut self, now: Instant) -> bool {
        self.clock.pause(now);
        self.clock.is_playing()
    }

    pub fn resume(&mut self, now: Instant) -> bool {
        self.clock.resume(now);
        self.clock.is_playing()
    }

    pub fn toggle_playback(&mut self, now: Instant) -> bool {
        self.clock.toggle(now)
    }

    pub fn reset_clock(&mut self, now: Instant) {
        self.clock.reset(now);
    }

    /// Compiles the sources and installs the result as the current program.
    ///
    /// The previously active program is deleted before compilation starts,
    /// so a failed compile leaves nothing installed and the screen keeps the
    /// last presented frame. A successful install clears the location cache
    /// for lazy repopulation against the new program.
    pub fn compile_and_install(
        &mut self,
        gl: &glow::Context,
        vertex_src: &str,
        fragment_src: &str,
        now: Instant,
    ) -> CompileOutcome {
        if let Some(previous) = self.program.take() {
            unsafe { gl.delete_program(previous) };
        }
        self.locations.clear();

        match compile_program(gl, vertex_src, fragment_src) {
            Ok(program) => {
                self.program = Some(program);
                if self.options.reset_time_on_compile {
                    self.clock.reset(now);
                }
                CompileOutcome {
                    success: true,
                    diagnostics: Vec::new(),
                }
            }
            Err(diagnostics) => {
                debug!(count = diagnostics.len(), "shader compile failed");
                CompileOutcome {
                    success: false,
                    diagnostics,
                }
            }
        }
    }

    /// Recreates the canvas target and feedback generation at a new size.
    /// The feedback texture is stale until a capture happens at that size.
    pub fn resize_canvas(&mut self, gl: &glow::Context, width: u32, height: u32) {
        let width = width.max(1);
        let height = height.max(1);
        self.canvas_size = (width, height);

        self.canvas = match self.canvas.take() {
            Some(target) => target.resize(gl, width, height),
            None => CanvasTarget::create(gl, width, height),
        }
        .map_err(|error| warn!(error = %error, "canvas target resize failed"))
        .ok();

        self.feedback = match self.feedback.take() {
            Some(feedback) => feedback.resize(gl, width, height),
            None => FeedbackBuffer::create(gl, width, height),
        }
        .map_err(|error| {
            warn!(error = %error, "feedback buffer resize failed; u_lastFrame disabled")
        })
        .ok();
    }

    /// Runs one frame: clock, FPS, builtin resolution, uniform binding, the
    /// draw call, feedback capture and presentation.
    pub fn render_frame(
        &mut self,
        gl: &glow::Context,
        registry: &mut UniformRegistry,
        textures: &mut TextureStore,
        input: &InputState,
        view: &ViewportTransform,
        container: (u32, u32),
        now: Instant,
    ) -> FrameReport {
        let time_seconds = self.clock.current_time(now);
        let fps = self.fps.tick(now);

        let feedback_binding = self
            .feedback
            .as_ref()
            .and_then(|feedback| feedback.binding(self.filtering));
        let mouse = input.normalized_canvas_position(&view.presented_rect());
        let ctx = BuiltinContext {
            time_seconds,
            canvas_size: self.canvas_size,
            mouse,
            input,
            feedback: feedback_binding,
        };
        let updates = registry.resolve_builtins(&ctx);

        let drawable = match (self.program, self.canvas.as_ref()) {
            (Some(program), Some(canvas)) => {
                canvas.bind_draw(gl);
                Some((program, canvas.framebuffer()))
            }
            _ => None,
        };
        if let Some((program, source)) = drawable {
            unsafe {
                gl.clear_color(0.0, 0.0, 0.0, 1.0);
                gl.clear(glow::COLOR_BUFFER_BIT);
                gl.use_program(Some(program));
                gl.bind_vertex_array(Some(self.vertex_array));
            }
            self.bind_uniforms(gl, program, registry, textures);
            unsafe {
                gl.draw_arrays(glow::TRIANGLES, 0, 3);
                gl.bind_vertex_array(None);
                gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            }

            if let Some(feedback) = self.feedback.as_mut() {
                feedback.capture(gl, source);
            }
        }

        if let Some(canvas) = self.canvas.as_ref() {
            canvas.present(gl, view, container, self.filtering);
        }

        FrameReport { updates, fps }
    }

    /// Sets every registry uniform on the program. Texture uniforms receive
    /// units `0..k` in registry iteration order whether or not a texture is
    /// currently available for them.
    fn bind_uniforms(
        &mut self,
        gl: &glow::Context,
        program: glow::Program,
        registry: &UniformRegistry,
        textures: &mut TextureStore,
    ) {
        let units: HashMap<String, u32> = registry.plan_texture_units().into_iter().collect();
        for uniform in registry.iter() {
            let name = uniform.name();
            match uniform.value() {
                UniformValue::Float(value) => {
                    if let Some(location) = self.uniform_location(gl, program, name) {
                        unsafe { gl.uniform_1_f32(Some(&location), *value) };
                    }
                }
                UniformValue::Int(value) => {
                    if let Some(location) = self.uniform_location(gl, program, name) {
                        unsafe { gl.uniform_1_i32(Some(&location), *value) };
                    }
                }
                UniformValue::Bool(value) => {
                    if let Some(location) = self.uniform_location(gl, program, name) {
                        unsafe { gl.uniform_1_i32(Some(&location), *value as i32) };
                    }
                }
                UniformValue::Vec2([x, y]) => {
                    if let Some(location) = self.uniform_location(gl, program, name) {
                        unsafe { gl.uniform_2_f32(Some(&location), *x, *y) };
                    }
                }
                UniformValue::Vec3([x, y, z]) => {
                    if let Some(location) = self.uniform_location(gl, program, name) {
                        unsafe { gl.uniform_3_f32(Some(&location), *x, *y, *z) };
                    }
                }
                UniformValue::Vec4([x, y, z, w]) => {
                    if let Some(location) = self.uniform_location(gl, program, name) {
                        unsafe { gl.uniform_4_f32(Some(&location), *x, *y, *z, *w) };
                    }
                }
                UniformValue::Texture(binding) => {
                    let Some(&unit) = units.get(name) else {
                        continue;
                    };
                    let resolved = textures
                        .get_mut(name)
                        .and_then(|resource| resource.ensure_uploaded(gl))
                        .or(*binding);
                    unsafe {
                        gl.active_texture(glow::TEXTURE0 + unit);
                        gl.bind_texture(
                            glow::TEXTURE_2D,
                            resolved.map(|binding| binding.texture),
                        );
                    }
                    if let Some(location) = self.uniform_location(gl, program, name) {
                        unsafe { gl.uniform_1_i32(Some(&location), unit as i32) };
                    }
                }
            }
        }
        unsafe { gl.active_texture(glow::TEXTURE0) };
    }

    fn uniform_location(
        &mut self,
        gl: &glow::Context,
        program: glow::Program,
        name: &str,
    ) -> Option<glow::UniformLocation> {
        if let Some(cached) = self.locations.get(name) {
            return cached.clone();
        }
        let location = unsafe { gl.get_uniform_location(program, name) };
        self.locations.insert(name.to_string(), location.clone());
        location
    }

    /// Releases every GPU object owned by the engine.
    pub fn destroy(mut self, gl: &glow::Context) {
        if let Some(program) = self.program.take() {
            unsafe { gl.delete_program(program) };
        }
        unsafe { gl.delete_vertex_array(self.vertex_array) };
        if let Some(canvas) = self.canvas.take() {
            canvas.destroy(gl);
        }
        if let Some(feedback) = self.feedback.take() {
            feedback.destroy(gl);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fps_counter_waits_for_a_sample_then_refreshes_sparsely() {
        let start = Instant::now();
        let mut counter = FpsCounter::new();

        assert_eq!(counter.tick(start), None);

        let sample = counter
            .tick(start + Duration::from_millis(16))
            .expect("first sample surfaces immediately");
        assert!((62..=63).contains(&sample));

        // Within the refresh window nothing new is surfaced.
        assert_eq!(counter.tick(start + Duration::from_millis(32)), None);
        assert_eq!(counter.tick(start + Duration::from_millis(48)), None);

        // Past the window a fresh rolling average appears.
        assert!(counter
            .tick(start + Duration::from_millis(16 + 500))
            .is_some());
    }

    #[test]
    fn fps_counter_averages_over_the_window() {
        let start = Instant::now();
        let mut counter = FpsCounter::new();
        let mut now = start;
        let mut last = None;
        for _ in 0..200 {
            now += Duration::from_millis(10);
            if let Some(sample) = counter.tick(now) {
                last = Some(sample);
            }
        }
        assert_eq!(last, Some(100));
    }
}
