//! Typed registry of shader inputs and their builtin associations.
//!
//! Uniform values are a tagged union keyed by the declared type, and the
//! registry is the single owner of that state: the renderer holds it by
//! reference and collaborators mutate it through the methods here rather
//! than through shared maps. Iteration order is definition order, which is
//! what drives texture-unit assignment during binding.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::input::InputState;
use crate::types::FilterMode;

/// Builtin uniforms registered at construction.
pub const TIME_UNIFORM: &str = "u_time";
pub const RESOLUTION_UNIFORM: &str = "u_resolution";
pub const MOUSE_UNIFORM: &str = "u_mouse";
pub const LAST_FRAME_UNIFORM: &str = "u_lastFrame";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UniformType {
    Float,
    Int,
    Bool,
    Vec2,
    Vec3,
    Vec4,
    Texture,
}

/// A GL texture ready to bind for a texture-valued uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureBinding {
    pub texture: glow::Texture,
    pub filter: FilterMode,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Bool(bool),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    /// `None` while no texture is available (e.g. `u_lastFrame` before the
    /// first capture, or a custom texture that failed to decode).
    Texture(Option<TextureBinding>),
}

impl UniformValue {
    pub fn kind(&self) -> UniformType {
        match self {
            UniformValue::Float(_) => UniformType::Float,
            UniformValue::Int(_) => UniformType::Int,
            UniformValue::Bool(_) => UniformType::Bool,
            UniformValue::Vec2(_) => UniformType::Vec2,
            UniformValue::Vec3(_) => UniformType::Vec3,
            UniformValue::Vec4(_) => UniformType::Vec4,
            UniformValue::Texture(_) => UniformType::Texture,
        }
    }
}

/// Runtime signal a uniform is automatically driven by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BuiltinBinding {
    Time,
    Resolution,
    Mouse,
    KeyState { code: Option<u32> },
    LastFrame,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Uniform {
    name: String,
    value: UniformValue,
    is_default: bool,
    manually_edited: bool,
}

impl Uniform {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &UniformValue {
        &self.value
    }

    pub fn kind(&self) -> UniformType {
        self.value.kind()
    }

    pub fn is_default(&self) -> bool {
        self.is_default
    }

    pub fn manually_edited(&self) -> bool {
        self.manually_edited
    }
}

/// A value that changed during builtin resolution, for UI redisplay.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformUpdate {
    pub name: String,
    pub kind: UniformType,
    pub value: UniformValue,
}

/// Frame inputs builtin resolution draws from.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinContext<'a> {
    pub time_seconds: f32,
    pub canvas_size: (u32, u32),
    /// Cursor normalized into the visible canvas area, already clamped.
    pub mouse: [f32; 2],
    pub input: &'a InputState,
    /// `None` while the feedback texture holds no frame yet.
    pub feedback: Option<TextureBinding>,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("uniform '{0}' already exists")]
    DuplicateName(String),
    #[error("uniform '{0}' is not defined")]
    UnknownUniform(String),
    #[error("uniform '{0}' is a builtin default and cannot be removed")]
    RemoveDefault(String),
}

#[derive(Debug, Default)]
pub struct UniformRegistry {
    uniforms: Vec<Uniform>,
    index: HashMap<String, usize>,
    builtins: HashMap<String, BuiltinBinding>,
}

impl UniformRegistry {
    /// Empty registry; most callers want [`UniformRegistry::with_defaults`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the system uniforms and their builtin
    /// associations.
    pub fn with_defaults(canvas_size: (u32, u32)) -> Self {
        let mut registry = Self::new();
        let defaults = [
            (TIME_UNIFORM, UniformValue::Float(0.0), BuiltinBinding::Time),
            (
                RESOLUTION_UNIFORM,
                UniformValue::Vec2([canvas_size.0 as f32, canvas_size.1 as f32]),
                BuiltinBinding::Resolution,
            ),
            (
                MOUSE_UNIFORM,
                UniformValue::Vec2([0.0, 0.0]),
                BuiltinBinding::Mouse,
            ),
            (
                LAST_FRAME_UNIFORM,
                UniformValue::Texture(None),
                BuiltinBinding::LastFrame,
            ),
        ];
        for (name, value, binding) in defaults {
            registry
                .define(name, value, true)
                .expect("default uniform names are unique");
            registry
                .bind_builtin(name, binding)
                .expect("default uniform was just defined");
        }
        registry
    }

    pub fn define(
        &mut self,
        name: &str,
        value: UniformValue,
        is_default: bool,
    ) -> Result<(), RegistryError> {
        if self.index.contains_key(name) {
            return Err(RegistryError::DuplicateName(name.to_string()));
        }
        self.index.insert(name.to_string(), self.uniforms.len());
        self.uniforms.push(Uniform {
            name: name.to_string(),
            value,
            is_default,
            manually_edited: false,
        });
        Ok(())
    }

    /// Updates a uniform's value. Unknown names and type mismatches are
    /// ignored (with a warning) so stale UI events cannot corrupt the
    /// registry. A manual edit marks the uniform as manually edited, which
    /// only builtin resolution of `u_resolution` consults.
    pub fn set_value(&mut self, name: &str, value: UniformValue, manual_edit: bool) {
        let Some(&i) = self.index.get(name) else {
            return;
        };
        let uniform = &mut self.uniforms[i];
        if uniform.value.kind() != value.kind() {
            warn!(
                uniform = name,
                expected = ?uniform.value.kind(),
                got = ?value.kind(),
                "ignoring uniform value with mismatched type"
            );
            return;
        }
        uniform.value = value;
        if manual_edit {
            uniform.manually_edited = true;
        }
    }

    /// Invoked when the canvas is deliberately resized to the stated value,
    /// re-enabling automatic resolution.
    pub fn clear_manual_flag(&mut self, name: &str) {
        if let Some(&i) = self.index.get(name) {
            self.uniforms[i].manually_edited = false;
        }
    }

    pub fn remove(&mut self, name: &str) -> Result<(), RegistryError> {
        let Some(&i) = self.index.get(name) else {
            return Err(RegistryError::UnknownUniform(name.to_string()));
        };
        if self.uniforms[i].is_default {
            return Err(RegistryError::RemoveDefault(name.to_string()));
        }
        self.uniforms.remove(i);
        self.builtins.remove(name);
        self.rebuild_index();
        Ok(())
    }

    pub fn bind_builtin(&mut self, name: &str, binding: BuiltinBinding) -> Result<(), RegistryError> {
        if !self.index.contains_key(name) {
            return Err(RegistryError::UnknownUniform(name.to_string()));
        }
        self.builtins.insert(name.to_string(), binding);
        Ok(())
    }

    pub fn unbind_builtin(&mut self, name: &str) {
        self.builtins.remove(name);
    }

    pub fn builtin_binding(&self, name: &str) -> Option<&BuiltinBinding> {
        self.builtins.get(name)
    }

    pub fn get(&self, name: &str) -> Option<&Uniform> {
        self.index.get(name).map(|&i| &self.uniforms[i])
    }

    pub fn len(&self) -> usize {
        self.uniforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uniforms.is_empty()
    }

    /// Uniforms in definition order.
    pub fn iter(&self) -> impl Iterator<Item = &Uniform> {
        self.uniforms.iter()
    }

    /// Texture-unit assignment for the current frame: texture-typed uniforms
    /// receive units `0..k` in definition order.
    pub fn plan_texture_units(&self) -> Vec<(String, u32)> {
        self.uniforms
            .iter()
            .filter(|uniform| uniform.kind() == UniformType::Texture)
            .zip(0u32..)
            .map(|(uniform, unit)| (uniform.name.clone(), unit))
            .collect()
    }

    /// Computes fresh values for every builtin-associated uniform and applies
    /// those that are not suppressed. Returns the values that actually
    /// changed, for downstream notification.
    pub fn resolve_builtins(&mut self, ctx: &BuiltinContext<'_>) -> Vec<UniformUpdate> {
        let mut updates = Vec::new();
        for uniform in &mut self.uniforms {
            let Some(binding) = self.builtins.get(&uniform.name) else {
                continue;
            };
            let resolved = match binding {
                BuiltinBinding::Time => UniformValue::Float(ctx.time_seconds),
                BuiltinBinding::Resolution => {
                    if uniform.manually_edited {
                        continue;
                    }
                    UniformValue::Vec2([ctx.canvas_size.0 as f32, ctx.canvas_size.1 as f32])
                }
                BuiltinBinding::Mouse => UniformValue::Vec2(ctx.mouse),
                BuiltinBinding::KeyState { code } => UniformValue::Bool(
                    code.map(|code| ctx.input.is_code_active(code))
                        .unwrap_or(false),
                ),
                BuiltinBinding::LastFrame => UniformValue::Texture(ctx.feedback),
            };
            if resolved != uniform.value {
                uniform.value = resolved;
                updates.push(UniformUpdate {
                    name: uniform.name.clone(),
                    kind: resolved.kind(),
                    value: resolved,
                });
            }
        }
        updates
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (i, uniform) in self.uniforms.iter().enumerate() {
            self.index.insert(uniform.name.clone(), i);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use super::*;

    fn context<'a>(input: &'a InputState) -> BuiltinContext<'a> {
        BuiltinContext {
            time_seconds: 1.25,
            canvas_size: (512, 512),
            mouse: [0.5, 0.5],
            input,
            feedback: None,
        }
    }

    fn fake_texture() -> TextureBinding {
        TextureBinding {
            texture: glow::NativeTexture(NonZeroU32::new(7).unwrap()),
            filter: FilterMode::Nearest,
        }
    }

    #[test]
    fn defining_a_duplicate_name_fails() {
        let mut registry = UniformRegistry::with_defaults((512, 512));
        let err = registry
            .define(TIME_UNIFORM, UniformValue::Float(0.0), false)
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateName(_)));
    }

    #[test]
    fn default_uniforms_cannot_be_removed() {
        let mut registry = UniformRegistry::with_defaults((512, 512));
        assert!(matches!(
            registry.remove(RESOLUTION_UNIFORM),
            Err(RegistryError::RemoveDefault(_))
        ));

        registry
            .define("u_speed", UniformValue::Float(2.0), false)
            .unwrap();
        registry.remove("u_speed").unwrap();
        assert!(registry.get("u_speed").is_none());
    }

    #[test]
    fn manual_resolution_edit_suppresses_automatic_value() {
        let mut registry = UniformRegistry::with_defaults((512, 512));
        let input = InputState::new();

        registry.set_value(RESOLUTION_UNIFORM, UniformValue::Vec2([100.0, 100.0]), true);
        let mut ctx = context(&input);
        ctx.canvas_size = (1024, 768);

        for _ in 0..3 {
            registry.resolve_builtins(&ctx);
            assert_eq!(
                registry.get(RESOLUTION_UNIFORM).unwrap().value(),
                &UniformValue::Vec2([100.0, 100.0])
            );
        }

        registry.clear_manual_flag(RESOLUTION_UNIFORM);
        registry.resolve_builtins(&ctx);
        assert_eq!(
            registry.get(RESOLUTION_UNIFORM).unwrap().value(),
            &UniformValue::Vec2([1024.0, 768.0])
        );
    }

    #[test]
    fn canvas_resize_flows_into_resolution_when_not_edited() {
        let mut registry = UniformRegistry::with_defaults((512, 512));
        let input = InputState::new();
        let mut ctx = context(&input);
        ctx.canvas_size = (1024, 768);
        registry.resolve_builtins(&ctx);
        assert_eq!(
            registry.get(RESOLUTION_UNIFORM).unwrap().value(),
            &UniformValue::Vec2([1024.0, 768.0])
        );
    }

    #[test]
    fn resolve_reports_only_changed_values() {
        let mut registry = UniformRegistry::with_defaults((512, 512));
        let input = InputState::new();
        let ctx = context(&input);

        let first = registry.resolve_builtins(&ctx);
        assert!(first.iter().any(|u| u.name == TIME_UNIFORM));

        // Same context again: nothing moved.
        let second = registry.resolve_builtins(&ctx);
        assert!(second.is_empty());
    }

    #[test]
    fn keystate_without_a_code_resolves_false() {
        let mut registry = UniformRegistry::with_defaults((512, 512));
        registry
            .define("u_pressed", UniformValue::Bool(true), false)
            .unwrap();
        registry
            .bind_builtin("u_pressed", BuiltinBinding::KeyState { code: None })
            .unwrap();

        let input = InputState::new();
        registry.resolve_builtins(&context(&input));
        assert_eq!(
            registry.get("u_pressed").unwrap().value(),
            &UniformValue::Bool(false)
        );
    }

    #[test]
    fn keystate_tracks_keys_and_mouse_buttons() {
        let mut registry = UniformRegistry::with_defaults((512, 512));
        registry
            .define("u_fire", UniformValue::Bool(false), false)
            .unwrap();
        registry
            .bind_builtin("u_fire", BuiltinBinding::KeyState { code: Some(32) })
            .unwrap();

        let mut input = InputState::new();
        input.set_key_pressed(32, true);
        registry.resolve_builtins(&context(&input));
        assert_eq!(
            registry.get("u_fire").unwrap().value(),
            &UniformValue::Bool(true)
        );

        input.set_key_pressed(32, false);
        input.set_button_pressed(32, true);
        registry.resolve_builtins(&context(&input));
        assert_eq!(
            registry.get("u_fire").unwrap().value(),
            &UniformValue::Bool(true)
        );
    }

    #[test]
    fn last_frame_resolves_to_none_until_feedback_exists() {
        let mut registry = UniformRegistry::with_defaults((512, 512));
        let input = InputState::new();

        registry.resolve_builtins(&context(&input));
        assert_eq!(
            registry.get(LAST_FRAME_UNIFORM).unwrap().value(),
            &UniformValue::Texture(None)
        );

        let mut ctx = context(&input);
        ctx.feedback = Some(fake_texture());
        registry.resolve_builtins(&ctx);
        assert_eq!(
            registry.get(LAST_FRAME_UNIFORM).unwrap().value(),
            &UniformValue::Texture(Some(fake_texture()))
        );
    }

    #[test]
    fn texture_units_are_distinct_and_in_definition_order() {
        let mut registry = UniformRegistry::with_defaults((512, 512));
        registry
            .define("u_noise", UniformValue::Texture(Some(fake_texture())), false)
            .unwrap();
        registry
            .define("u_speed", UniformValue::Float(1.0), false)
            .unwrap();
        registry
            .define("u_gradient", UniformValue::Texture(None), false)
            .unwrap();

        let plan = registry.plan_texture_units();
        let names: Vec<&str> = plan.iter().map(|(name, _)| name.as_str()).collect();
        let units: Vec<u32> = plan.iter().map(|(_, unit)| *unit).collect();
        assert_eq!(names, vec![LAST_FRAME_UNIFORM, "u_noise", "u_gradient"]);
        assert_eq!(units, vec![0, 1, 2]);
    }

    #[test]
    fn mismatched_value_types_are_ignored() {
        let mut registry = UniformRegistry::with_defaults((512, 512));
        registry.set_value(TIME_UNIFORM, UniformValue::Bool(true), true);
        assert_eq!(
            registry.get(TIME_UNIFORM).unwrap().value(),
            &UniformValue::Float(0.0)
        );
    }

    #[test]
    fn unknown_names_are_a_no_op() {
        let mut registry = UniformRegistry::with_defaults((512, 512));
        registry.set_value("u_missing", UniformValue::Float(1.0), true);
        registry.clear_manual_flag("u_missing");
        assert!(registry.get("u_missing").is_none());
    }

    #[test]
    fn builtin_binding_requires_a_registered_name() {
        let mut registry = UniformRegistry::new();
        assert!(matches!(
            registry.bind_builtin("u_ghost", BuiltinBinding::Time),
            Err(RegistryError::UnknownUniform(_))
        ));
    }
}
