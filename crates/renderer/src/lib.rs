//! Rendering and diagnostics engine for ShaderDesk.
//!
//! The crate glues user-edited GLSL, a typed uniform registry, and an OpenGL
//! render loop together. The overall flow is:
//!
//! ```text
//!   editor / shaderdesk
//!          │ vertex + fragment source (debounced)
//!          ▼
//!   RenderState::compile_and_install ──▶ gpu::compile ──▶ diagnostics::parse_compile_log
//!          │ program + cleared location cache
//!          ▼
//!   RenderState::render_frame ──▶ UniformRegistry::resolve_builtins ─▶ GL uniforms
//!          │                                   ▲
//!          └─▶ draw ─▶ FeedbackBuffer::capture ┘ (u_lastFrame next tick)
//! ```
//!
//! `RenderState` owns every GPU object (program, VAO, canvas target, feedback
//! generation) and drives the per-frame sequence; the registry, clock,
//! viewport, input tracker and debouncer are plain state machines that never
//! touch the GL context, so they carry the unit-test surface. Compile and
//! link failures never escape as errors: they come back as structured
//! [`Diagnostic`](diagnostics::Diagnostic) values and the loop keeps running
//! with the previous frame contents.

pub mod clock;
pub mod debounce;
pub mod diagnostics;
pub mod gpu;
pub mod input;
pub mod snapshot;
pub mod types;
pub mod uniforms;
pub mod viewport;

pub use clock::AnimationClock;
pub use debounce::Debouncer;
pub use diagnostics::{parse_compile_log, Diagnostic, Severity, ShaderStage};
pub use gpu::state::{CompileOutcome, FrameReport, RenderState};
pub use gpu::texture::{TextureResource, TextureStore};
pub use input::InputState;
pub use snapshot::ProjectSnapshot;
pub use types::{CanvasConfig, EngineOptions, FilterMode};
pub use uniforms::{
    BuiltinBinding, BuiltinContext, TextureBinding, Uniform, UniformRegistry, UniformType,
    UniformUpdate, UniformValue,
};
pub use viewport::{PanBounds, ViewState, ViewportTransform, ZoomBounds};
