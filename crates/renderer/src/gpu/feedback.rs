//! Previous-frame capture for the `u_lastFrame` builtin.
//!
//! A single framebuffer/texture pair sized to the canvas. After each draw
//! the canvas target is blitted into it (nearest filter), so the texture the
//! shader samples next frame always holds the previous frame. Until the
//! first capture after creation or a resize the contents are stale and the
//! builtin must not expose them.

use glow::HasContext;

use crate::types::FilterMode;
use crate::uniforms::TextureBinding;

use super::OffscreenError;

/// The GL-free half of the buffer: size and staleness tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackState {
    width: u32,
    height: u32,
    first_frame: bool,
}

impl FeedbackState {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            first_frame: true,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_first_frame(&self) -> bool {
        self.first_frame
    }

    pub fn mark_captured(&mut self) {
        self.first_frame = false;
    }
}

pub struct FeedbackBuffer {
    framebuffer: glow::Framebuffer,
    texture: glow::Texture,
    state: FeedbackState,
}

impl FeedbackBuffer {
    pub fn create(gl: &glow::Context, width: u32, height: u32) -> Result<Self, OffscreenError> {
        let state = FeedbackState::new(width, height);
        let (framebuffer, texture) = allocate_attachment(gl, state.width, state.height)?;
        Ok(Self {
            framebuffer,
            texture,
            state,
        })
    }

    /// Releases the current generation and allocates a fresh one. The new
    /// texture is stale until the next capture, whether or not the old one
    /// had content.
    pub fn resize(
        self,
        gl: &glow::Context,
        width: u32,
        height: u32,
    ) -> Result<Self, OffscreenError> {
        self.destroy(gl);
        Self::create(gl, width, height)
    }

    /// Copies the just-rendered canvas into the feedback texture.
    pub fn capture(&mut self, gl: &glow::Context, source: glow::Framebuffer) {
        let (width, height) = self.state.size();
        unsafe {
            gl.bind_framebuffer(glow::READ_FRAMEBUFFER, Some(source));
            gl.bind_framebuffer(glow::DRAW_FRAMEBUFFER, Some(self.framebuffer));
            gl.blit_framebuffer(
                0,
                0,
                width as i32,
                height as i32,
                0,
                0,
                width as i32,
                height as i32,
                glow::COLOR_BUFFER_BIT,
                glow::NEAREST,
            );
            gl.bind_framebuffer(glow::READ_FRAMEBUFFER, None);
            gl.bind_framebuffer(glow::DRAW_FRAMEBUFFER, None);
        }
        self.state.mark_captured();
    }

    /// Binding for the `LastFrame` builtin; `None` while the texture holds
    /// no captured frame.
    pub fn binding(&self, filter: FilterMode) -> Option<TextureBinding> {
        if self.state.is_first_frame() {
            None
        } else {
            Some(TextureBinding {
                texture: self.texture,
                filter,
            })
        }
    }

    pub fn is_first_frame(&self) -> bool {
        self.state.is_first_frame()
    }

    pub fn size(&self) -> (u32, u32) {
        self.state.size()
    }

    pub fn destroy(self, gl: &glow::Context) {
        unsafe {
            gl.delete_framebuffer(self.framebuffer);
            gl.delete_texture(self.texture);
        }
    }
}

fn allocate_attachment(
    gl: &glow::Context,
    width: u32,
    height: u32,
) -> Result<(glow::Framebuffer, glow::Texture), OffscreenError> {
    unsafe {
        let framebuffer = gl
            .create_framebuffer()
            .map_err(OffscreenError::Create)?;
        let texture = match gl.create_texture() {
            Ok(texture) => texture,
            Err(error) => {
                gl.delete_framebuffer(framebuffer);
                return Err(OffscreenError::Create(error));
            }
        };

        gl.bind_texture(glow::TEXTURE_2D, Some(texture));
        gl.tex_parameter_i32(
            glow::TEXTURE_2D,
            glow::TEXTURE_MIN_FILTER,
            glow::NEAREST as i32,
        );
        gl.tex_parameter_i32(
            glow::TEXTURE_2D,
            glow::TEXTURE_MAG_FILTER,
            glow::NEAREST as i32,
        );
        gl.tex_parameter_i32(
            glow::TEXTURE_2D,
            glow::TEXTURE_WRAP_S,
            glow::CLAMP_TO_EDGE as i32,
        );
        gl.tex_parameter_i32(
            glow::TEXTURE_2D,
            glow::TEXTURE_WRAP_T,
            glow::CLAMP_TO_EDGE as i32,
        );
        gl.tex_image_2d(
            glow::TEXTURE_2D,
            0,
            glow::RGBA8 as i32,
            width as i32,
            height as i32,
            0,
            glow::RGBA,
            glow::UNSIGNED_BYTE,
            None,
        );
        gl.bind_texture(glow::TEXTURE_2D, None);

        gl.bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));
        gl.framebuffer_texture_2d(
            glow::FRAMEBUFFER,
            glow::COLOR_ATTACHMENT0,
            glow::TEXTURE_2D,
            Some(texture),
            0,
        );
        let status = gl.check_framebuffer_status(glow::FRAMEBUFFER);
        gl.bind_framebuffer(glow::FRAMEBUFFER, None);

        if status != glow::FRAMEBUFFER_COMPLETE {
            gl.delete_framebuffer(framebuffer);
            gl.delete_texture(texture);
            return Err(OffscreenError::Incomplete(status));
        }
        Ok((framebuffer, texture))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_stale_and_clears_after_one_capture() {
        let mut state = FeedbackState::new(512, 512);
        assert!(state.is_first_frame());
        state.mark_captured();
        assert!(!state.is_first_frame());
        state.mark_captured();
        assert!(!state.is_first_frame());
    }

    #[test]
    fn resize_always_produces_a_stale_generation() {
        let mut state = FeedbackState::new(512, 512);
        state.mark_captured();
        // A resize replaces the whole state.
        state = FeedbackState::new(1024, 768);
        assert!(state.is_first_frame());
        assert_eq!(state.size(), (1024, 768));
    }

    #[test]
    fn degenerate_sizes_are_clamped() {
        assert_eq!(FeedbackState::new(0, 0).size(), (1, 1));
    }
}
