//! GL-facing half of the engine: program compilation, offscreen targets,
//! texture uniforms and the per-frame render state. Everything here takes a
//! `&glow::Context` rather than owning one; the embedding application owns
//! context creation and current-ness.

pub mod compile;
pub mod feedback;
pub mod state;
pub mod target;
pub mod texture;

use thiserror::Error;

/// Failure to build an offscreen framebuffer/texture pair.
///
/// Always non-fatal: the render loop drops the affected resource and keeps
/// going (for the feedback buffer that means `u_lastFrame` resolves to no
/// texture until a later resize succeeds).
#[derive(Debug, Error)]
pub enum OffscreenError {
    #[error("framebuffer incomplete (status {0:#x})")]
    Incomplete(u32),
    #[error("failed to create GL object: {0}")]
    Create(String),
}
