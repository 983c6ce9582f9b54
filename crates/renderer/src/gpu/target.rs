//! Offscreen canvas render target and its on-screen presentation.
//!
//! The shader always renders at canvas resolution into this target; the
//! window only ever sees a blit of the finished frame at the viewport's
//! pan/zoom placement. Keeping the two sizes independent is what lets
//! `u_resolution` stay decoupled from the window.

use glow::HasContext;

use crate::types::FilterMode;
use crate::viewport::ViewportTransform;

use super::OffscreenError;

pub struct CanvasTarget {
    framebuffer: glow::Framebuffer,
    texture: glow::Texture,
    width: u32,
    height: u32,
}

impl CanvasTarget {
    pub fn create(gl: &glow::Context, width: u32, height: u32) -> Result<Self, OffscreenError> {
        let width = width.max(1);
        let height = height.max(1);
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
                glow::LINEAR as i32,
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MAG_FILTER,
                glow::LINEAR as i32,
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

            Ok(Self {
                framebuffer,
                texture,
                width,
                height,
            })
        }
    }

    pub fn resize(
        self,
        gl: &glow::Context,
        width: u32,
        height: u32,
    ) -> Result<Self, OffscreenError> {
        self.destroy(gl);
        Self::create(gl, width, height)
    }

    pub fn framebuffer(&self) -> glow::Framebuffer {
        self.framebuffer
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Binds the target for drawing and sets the viewport to cover it.
    pub fn bind_draw(&self, gl: &glow::Context) {
        unsafe {
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(self.framebuffer));
            gl.viewport(0, 0, self.width as i32, self.height as i32);
        }
    }

    /// Blits the finished canvas onto the default framebuffer at the
    /// viewport's pan/zoom placement. Presentation only; canvas pixels are
    /// already final.
    pub fn present(
        &self,
        gl: &glow::Context,
        view: &ViewportTransform,
        container: (u32, u32),
        filter: FilterMode,
    ) {
        let rect = view.presented_rect();
        let container_h = container.1 as f32;
        // Window coordinates are top-left; GL blits bottom-left.
        let dst_x0 = rect.x;
        let dst_y0 = container_h - rect.y - rect.height;
        let dst_x1 = rect.x + rect.width;
        let dst_y1 = container_h - rect.y;
        let gl_filter = match filter {
            FilterMode::Nearest => glow::NEAREST,
            FilterMode::Linear => glow::LINEAR,
        };

        unsafe {
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            gl.viewport(0, 0, container.0 as i32, container.1 as i32);
            gl.clear_color(0.08, 0.08, 0.1, 1.0);
            gl.clear(glow::COLOR_BUFFER_BIT);

            gl.bind_framebuffer(glow::READ_FRAMEBUFFER, Some(self.framebuffer));
            gl.bind_framebuffer(glow::DRAW_FRAMEBUFFER, None);
            gl.blit_framebuffer(
                0,
                0,
                self.width as i32,
                self.height as i32,
                dst_x0 as i32,
                dst_y0 as i32,
                dst_x1 as i32,
                dst_y1 as i32,
                glow::COLOR_BUFFER_BIT,
                gl_filter,
            );
            gl.bind_framebuffer(glow::READ_FRAMEBUFFER, None);
        }
    }

    pub fn destroy(self, gl: &glow::Context) {
        unsafe {
            gl.delete_framebuffer(self.framebuffer);
            gl.delete_texture(self.texture);
        }
    }
}
