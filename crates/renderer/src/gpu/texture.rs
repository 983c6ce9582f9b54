//! User-provided texture uniforms.
//!
//! Each resource keeps its encoded image payload (the form it persists in)
//! plus an explicit phase: `Dirty` payloads decode and upload on the next
//! frame bind, `Clean` resources reuse the existing GL texture, `Disposed`
//! resources stay unavailable until a new payload arrives. GL recreation
//! only ever happens on the `Dirty → Clean` transition.

use std::collections::HashMap;

use glow::HasContext;
use image::imageops::flip_vertical_in_place;
use tracing::warn;

use crate::types::FilterMode;
use crate::uniforms::TextureBinding;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TexturePhase {
    Clean,
    Dirty,
    Disposed,
}

pub struct TextureResource {
    payload: Vec<u8>,
    texture: Option<glow::Texture>,
    phase: TexturePhase,
    size: (u32, u32),
    filter: FilterMode,
}

impl TextureResource {
    /// Wraps an encoded image (PNG/JPEG/BMP/GIF bytes) for later upload.
    pub fn from_encoded(payload: Vec<u8>, filter: FilterMode) -> Self {
        Self {
            payload,
            texture: None,
            phase: TexturePhase::Dirty,
            size: (0, 0),
            filter,
        }
    }

    pub fn phase(&self) -> TexturePhase {
        self.phase
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Replaces the payload; the GL side refreshes on the next bind.
    pub fn set_payload(&mut self, payload: Vec<u8>) {
        self.payload = payload;
        self.phase = TexturePhase::Dirty;
    }

    /// Returns the uploadable binding, decoding and uploading first if the
    /// payload is dirty. A payload that fails to decode disposes the
    /// resource rather than retrying every frame.
    pub fn ensure_uploaded(&mut self, gl: &glow::Context) -> Option<TextureBinding> {
        match self.phase {
            TexturePhase::Clean => {}
            TexturePhase::Disposed => return None,
            TexturePhase::Dirty => {
                let decoded = match image::load_from_memory(&self.payload) {
                    Ok(decoded) => decoded,
                    Err(error) => {
                        warn!(error = %error, "failed to decode texture payload; disposing");
                        self.release(gl);
                        self.phase = TexturePhase::Disposed;
                        return None;
                    }
                };
                let mut rgba = decoded.to_rgba8();
                flip_vertical_in_place(&mut rgba);
                let (width, height) = rgba.dimensions();

                self.release(gl);
                let texture = unsafe {
                    match gl.create_texture() {
                        Ok(texture) => texture,
                        Err(error) => {
                            warn!(error = %error, "failed to create texture object; disposing");
                            self.phase = TexturePhase::Disposed;
                            return None;
                        }
                    }
                };
                let gl_filter = match self.filter {
                    FilterMode::Nearest => glow::NEAREST,
                    FilterMode::Linear => glow::LINEAR,
                };
                unsafe {
                    gl.bind_texture(glow::TEXTURE_2D, Some(texture));
                    gl.tex_parameter_i32(
                        glow::TEXTURE_2D,
                        glow::TEXTURE_MIN_FILTER,
                        gl_filter as i32,
                    );
                    gl.tex_parameter_i32(
                        glow::TEXTURE_2D,
                        glow::TEXTURE_MAG_FILTER,
                        gl_filter as i32,
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
                        Some(&rgba),
                    );
                    gl.bind_texture(glow::TEXTURE_2D, None);
                }
                self.texture = Some(texture);
                self.size = (width, height);
                self.phase = TexturePhase::Clean;
            }
        }
        self.texture.map(|texture| TextureBinding {
            texture,
            filter: self.filter,
        })
    }

    pub fn dispose(&mut self, gl: &glow::Context) {
        self.release(gl);
        self.phase = TexturePhase::Disposed;
    }

    fn release(&mut self, gl: &glow::Context) {
        if let Some(texture) = self.texture.take() {
            unsafe { gl.delete_texture(texture) };
        }
    }
}

/// Texture resources for custom uniforms, keyed by uniform name.
#[derive(Default)]
pub struct TextureStore {
    resources: HashMap<String, TextureResource>,
}

impl TextureStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, resource: TextureResource) {
        self.resources.insert(name.into(), resource);
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut TextureResource> {
        self.resources.get_mut(name)
    }

    pub fn get(&self, name: &str) -> Option<&TextureResource> {
        self.resources.get(name)
    }

    pub fn remove(&mut self, gl: &glow::Context, name: &str) {
        if let Some(mut resource) = self.resources.remove(name) {
            resource.dispose(gl);
        }
    }

    pub fn dispose_all(&mut self, gl: &glow::Context) {
        for resource in self.resources.values_mut() {
            resource.dispose(gl);
        }
        self.resources.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_payloads_start_dirty() {
        let resource = TextureResource::from_encoded(vec![1, 2, 3], FilterMode::Linear);
        assert_eq!(resource.phase(), TexturePhase::Dirty);
    }

    #[test]
    fn replacing_the_payload_marks_dirty_again() {
        let mut resource = TextureResource::from_encoded(vec![1, 2, 3], FilterMode::Linear);
        resource.phase = TexturePhase::Clean;
        resource.set_payload(vec![4, 5]);
        assert_eq!(resource.phase(), TexturePhase::Dirty);
        assert_eq!(resource.payload(), &[4, 5]);
    }
}
