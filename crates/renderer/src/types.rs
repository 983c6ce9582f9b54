use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Texture sampling used for the canvas presentation blit and for texture
/// uniforms that do not request anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    Nearest,
    #[default]
    Linear,
}

/// Canvas geometry and sampling as persisted in a project snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub filtering: FilterMode,
}

impl CanvasConfig {
    pub fn new(width: u32, height: u32, filtering: FilterMode) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            filtering,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Engine behaviour knobs supplied by the caller at start-up.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOptions {
    /// Restart the animation clock whenever a compile succeeds.
    pub reset_time_on_compile: bool,
    /// Quiet period after the last edit before a compile fires.
    pub compile_debounce: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            reset_time_on_compile: false,
            compile_debounce: Duration::from_millis(500),
        }
    }
}
