//! Persisted project state: everything the engine can restore.
//!
//! The snapshot carries uniform definitions and values, builtin
//! associations, canvas geometry and the view transform. Texture uniforms
//! bound to the previous-frame builtin are regenerated at runtime and
//! export as `null`; custom texture uniforms export their encoded image
//! payload verbatim. Framing (where the JSON lives, when it is written) is
//! the embedding application's concern.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use crate::gpu::texture::{TextureResource, TextureStore};
use crate::types::CanvasConfig;
use crate::uniforms::{
    BuiltinBinding, RegistryError, UniformRegistry, UniformType, UniformValue,
};
use crate::viewport::{ViewState, ViewportTransform};

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("uniform '{0}' carries a malformed value")]
    BadValue(String),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniformEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: UniformType,
    pub value: Value,
    #[serde(default)]
    pub default: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    pub uniforms: Vec<UniformEntry>,
    #[serde(default)]
    pub builtin_associations: BTreeMap<String, BuiltinBinding>,
    pub canvas: CanvasConfig,
    pub view: ViewState,
}

/// Serializes all non-transient engine state.
pub fn export(
    registry: &UniformRegistry,
    view: &ViewportTransform,
    canvas: CanvasConfig,
    textures: &TextureStore,
) -> ProjectSnapshot {
    let uniforms = registry
        .iter()
        .map(|uniform| {
            let value = match uniform.value() {
                UniformValue::Float(v) => json!(v),
                UniformValue::Int(v) => json!(v),
                UniformValue::Bool(v) => json!(v),
                UniformValue::Vec2(v) => json!(v),
                UniformValue::Vec3(v) => json!(v),
                UniformValue::Vec4(v) => json!(v),
                UniformValue::Texture(_) => {
                    let last_frame = matches!(
                        registry.builtin_binding(uniform.name()),
                        Some(BuiltinBinding::LastFrame)
                    );
                    if last_frame {
                        Value::Null
                    } else {
                        textures
                            .get(uniform.name())
                            .map(|resource| json!(resource.payload()))
                            .unwrap_or(Value::Null)
                    }
                }
            };
            UniformEntry {
                name: uniform.name().to_string(),
                kind: uniform.kind(),
                value,
                default: uniform.is_default(),
            }
        })
        .collect();

    let builtin_associations = registry
        .iter()
        .filter_map(|uniform| {
            registry
                .builtin_binding(uniform.name())
                .map(|binding| (uniform.name().to_string(), *binding))
        })
        .collect();

    ProjectSnapshot {
        uniforms,
        builtin_associations,
        canvas,
        view: view.view_state(),
    }
}

/// Applies a snapshot to the live registry, viewport and texture store.
///
/// Imported values are applied as manual edits, so an imported resolution
/// survives automatic resolution until the canvas is deliberately resized.
/// Returns the canvas configuration so the caller can resize GL targets.
pub fn import(
    snapshot: &ProjectSnapshot,
    registry: &mut UniformRegistry,
    view: &mut ViewportTransform,
    textures: &mut TextureStore,
) -> Result<CanvasConfig, SnapshotError> {
    for entry in &snapshot.uniforms {
        let value = entry_value(entry, snapshot.canvas, textures)?;
        if registry.get(&entry.name).is_none() {
            registry.define(&entry.name, value, entry.default)?;
        }
        registry.set_value(&entry.name, value, true);
    }

    for (name, binding) in &snapshot.builtin_associations {
        if let Err(error) = registry.bind_builtin(name, *binding) {
            warn!(uniform = name.as_str(), error = %error, "dropping stale builtin association");
        }
    }

    view.apply_view_state(&snapshot.view);
    Ok(snapshot.canvas)
}

fn entry_value(
    entry: &UniformEntry,
    canvas: CanvasConfig,
    textures: &mut TextureStore,
) -> Result<UniformValue, SnapshotError> {
    let bad = || SnapshotError::BadValue(entry.name.clone());
    let value = match entry.kind {
        UniformType::Float => UniformValue::Float(entry.value.as_f64().ok_or_else(bad)? as f32),
        UniformType::Int => {
            UniformValue::Int(entry.value.as_i64().ok_or_else(bad)?.try_into().map_err(|_| bad())?)
        }
        UniformType::Bool => UniformValue::Bool(entry.value.as_bool().ok_or_else(bad)?),
        UniformType::Vec2 => UniformValue::Vec2(vector(&entry.value).ok_or_else(bad)?),
        UniformType::Vec3 => UniformValue::Vec3(vector(&entry.value).ok_or_else(bad)?),
        UniformType::Vec4 => UniformValue::Vec4(vector(&entry.value).ok_or_else(bad)?),
        UniformType::Texture => match &entry.value {
            Value::Null => UniformValue::Texture(None),
            Value::Array(_) => {
                let payload: Vec<u8> =
                    serde_json::from_value(entry.value.clone()).map_err(|_| bad())?;
                textures.insert(
                    entry.name.clone(),
                    TextureResource::from_encoded(payload, canvas.filtering),
                );
                UniformValue::Texture(None)
            }
            _ => return Err(bad()),
        },
    };
    Ok(value)
}

fn vector<const N: usize>(value: &Value) -> Option<[f32; N]> {
    let array = value.as_array()?;
    if array.len() != N {
        return None;
    }
    let mut out = [0.0; N];
    for (slot, item) in out.iter_mut().zip(array) {
        *slot = item.as_f64()? as f32;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::InputState;
    use crate::types::FilterMode;
    use crate::uniforms::{BuiltinContext, RESOLUTION_UNIFORM, LAST_FRAME_UNIFORM};
    use crate::gpu::texture::TexturePhase;

    fn canvas() -> CanvasConfig {
        CanvasConfig::new(512, 512, FilterMode::Linear)
    }

    #[test]
    fn last_frame_texture_exports_as_null() {
        let registry = UniformRegistry::with_defaults((512, 512));
        let view = ViewportTransform::new((1280, 720), (512, 512));
        let snapshot = export(&registry, &view, canvas(), &TextureStore::new());

        let entry = snapshot
            .uniforms
            .iter()
            .find(|entry| entry.name == LAST_FRAME_UNIFORM)
            .unwrap();
        assert_eq!(entry.kind, UniformType::Texture);
        assert!(entry.value.is_null());
    }

    #[test]
    fn custom_texture_payload_round_trips_through_the_store() {
        let mut registry = UniformRegistry::with_defaults((512, 512));
        registry
            .define("u_noise", UniformValue::Texture(None), false)
            .unwrap();
        let mut textures = TextureStore::new();
        textures.insert(
            "u_noise",
            TextureResource::from_encoded(vec![9, 8, 7], FilterMode::Linear),
        );

        let view = ViewportTransform::new((1280, 720), (512, 512));
        let snapshot = export(&registry, &view, canvas(), &textures);
        let entry = snapshot
            .uniforms
            .iter()
            .find(|entry| entry.name == "u_noise")
            .unwrap();
        assert!(entry.value.is_array());

        let mut fresh_registry = UniformRegistry::with_defaults((512, 512));
        let mut fresh_view = ViewportTransform::new((1280, 720), (512, 512));
        let mut fresh_textures = TextureStore::new();
        import(
            &snapshot,
            &mut fresh_registry,
            &mut fresh_view,
            &mut fresh_textures,
        )
        .unwrap();

        let resource = fresh_textures.get("u_noise").unwrap();
        assert_eq!(resource.payload(), &[9, 8, 7]);
        assert_eq!(resource.phase(), TexturePhase::Dirty);
        assert!(fresh_registry.get("u_noise").is_some());
    }

    #[test]
    fn imported_values_count_as_manual_edits() {
        let mut registry = UniformRegistry::with_defaults((512, 512));
        registry.set_value(RESOLUTION_UNIFORM, UniformValue::Vec2([640.0, 480.0]), true);
        let view = ViewportTransform::new((1280, 720), (512, 512));
        let snapshot = export(&registry, &view, canvas(), &TextureStore::new());

        let mut fresh_registry = UniformRegistry::with_defaults((1024, 768));
        let mut fresh_view = ViewportTransform::new((1280, 720), (1024, 768));
        import(
            &snapshot,
            &mut fresh_registry,
            &mut fresh_view,
            &mut TextureStore::new(),
        )
        .unwrap();

        // Automatic resolution must not clobber the imported value.
        let input = InputState::new();
        let ctx = BuiltinContext {
            time_seconds: 0.0,
            canvas_size: (1024, 768),
            mouse: [0.0, 0.0],
            input: &input,
            feedback: None,
        };
        fresh_registry.resolve_builtins(&ctx);
        assert_eq!(
            fresh_registry.get(RESOLUTION_UNIFORM).unwrap().value(),
            &UniformValue::Vec2([640.0, 480.0])
        );
    }

    #[test]
    fn json_round_trip_preserves_shape() {
        let mut registry = UniformRegistry::with_defaults((512, 512));
        registry
            .define("u_speed", UniformValue::Float(2.5), false)
            .unwrap();
        registry
            .define("u_tint", UniformValue::Vec3([0.1, 0.2, 0.3]), false)
            .unwrap();
        registry
            .bind_builtin("u_speed", BuiltinBinding::KeyState { code: Some(32) })
            .unwrap();

        let view = ViewportTransform::new((1280, 720), (512, 512));
        let snapshot = export(&registry, &view, canvas(), &TextureStore::new());
        let text = serde_json::to_string(&snapshot).unwrap();
        let parsed: ProjectSnapshot = serde_json::from_str(&text).unwrap();

        assert_eq!(parsed.uniforms.len(), snapshot.uniforms.len());
        assert_eq!(
            parsed.builtin_associations.get("u_speed"),
            Some(&BuiltinBinding::KeyState { code: Some(32) })
        );
        assert_eq!(parsed.canvas, canvas());
    }

    #[test]
    fn malformed_values_are_rejected() {
        let snapshot = ProjectSnapshot {
            uniforms: vec![UniformEntry {
                name: "u_bad".to_string(),
                kind: UniformType::Vec2,
                value: json!([1.0]),
                default: false,
            }],
            builtin_associations: BTreeMap::new(),
            canvas: canvas(),
            view: ViewportTransform::new((1280, 720), (512, 512)).view_state(),
        };
        let result = import(
            &snapshot,
            &mut UniformRegistry::with_defaults((512, 512)),
            &mut ViewportTransform::new((1280, 720), (512, 512)),
            &mut TextureStore::new(),
        );
        assert!(matches!(result, Err(SnapshotError::BadValue(_))));
    }
}
