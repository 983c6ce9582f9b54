//! Pan/zoom state for inspecting the canvas.
//!
//! The transform only affects how the finished canvas is presented inside
//! its container; the GPU pipeline never sees it. Bounds are dynamic: zoom
//! limits derive from the container-fit ratio and panning always keeps a
//! margin of the canvas visible.

use serde::{Deserialize, Serialize};

const MAX_ZOOM: f32 = 8.0;
const MIN_ZOOM_FLOOR: f32 = 0.1;
const MIN_ZOOM_ABSOLUTE: f32 = 0.05;
const FIT_MARGIN: f32 = 0.9;
/// Pixels of the (zoomed) canvas that must stay visible on each axis.
const PAN_VISIBLE_MARGIN: f32 = 48.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomBounds {
    pub min: f32,
    pub max: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanBounds {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
}

impl PanBounds {
    fn clamp(&self, x: f32, y: f32) -> (f32, f32) {
        (x.clamp(self.min_x, self.max_x), y.clamp(self.min_y, self.max_y))
    }
}

/// Canvas placement inside the container, top-left origin, container pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PresentedRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// View-changed notification payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViewChange {
    pub offset: (f32, f32),
    pub zoom: f32,
}

/// Persisted view state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub offset: ViewOffset,
    pub zoom: f32,
    pub pan_zoom_enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewOffset {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone)]
pub struct ViewportTransform {
    offset: (f32, f32),
    zoom: f32,
    pan_zoom_enabled: bool,
    container: (f32, f32),
    canvas: (f32, f32),
}

impl ViewportTransform {
    pub fn new(container: (u32, u32), canvas: (u32, u32)) -> Self {
        let mut transform = Self {
            offset: (0.0, 0.0),
            zoom: 1.0,
            pan_zoom_enabled: true,
            container: to_f32(container),
            canvas: to_f32(canvas),
        };
        transform.reset();
        transform
    }

    pub fn offset(&self) -> (f32, f32) {
        self.offset
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn pan_zoom_enabled(&self) -> bool {
        self.pan_zoom_enabled
    }

    pub fn set_pan_zoom_enabled(&mut self, enabled: bool) {
        self.pan_zoom_enabled = enabled;
    }

    pub fn set_container_size(&mut self, container: (u32, u32)) -> ViewChange {
        self.container = to_f32(container);
        self.reclamp()
    }

    pub fn set_canvas_size(&mut self, canvas: (u32, u32)) -> ViewChange {
        self.canvas = to_f32(canvas);
        self.reclamp()
    }

    /// Zoom ratio at which the canvas exactly fits the container.
    pub fn fit_zoom(&self) -> f32 {
        let (cw, ch) = self.container;
        let (gw, gh) = self.canvas;
        (cw / gw).min(ch / gh)
    }

    pub fn zoom_bounds(&self) -> ZoomBounds {
        let fit = self.fit_zoom() * FIT_MARGIN;
        ZoomBounds {
            min: fit.min(MIN_ZOOM_FLOOR).max(MIN_ZOOM_ABSOLUTE),
            max: MAX_ZOOM,
        }
    }

    pub fn pan_bounds(&self) -> PanBounds {
        let (cw, ch) = self.container;
        let (gw, gh) = self.canvas;
        let extent_x = (cw * 0.5 + gw * self.zoom * 0.5 - PAN_VISIBLE_MARGIN).max(0.0);
        let extent_y = (ch * 0.5 + gh * self.zoom * 0.5 - PAN_VISIBLE_MARGIN).max(0.0);
        PanBounds {
            min_x: -extent_x,
            max_x: extent_x,
            min_y: -extent_y,
            max_y: extent_y,
        }
    }

    /// Zooms around the cursor: the content point under the cursor before
    /// the zoom stays under it afterwards, offset permitting.
    pub fn apply_zoom(&mut self, delta: f32, cursor_x: f32, cursor_y: f32) -> ViewChange {
        let (cw, ch) = self.container;
        let centered_x = cursor_x - cw * 0.5;
        let centered_y = cursor_y - ch * 0.5;
        let content_x = (centered_x - self.offset.0) / self.zoom;
        let content_y = (centered_y - self.offset.1) / self.zoom;

        let bounds = self.zoom_bounds();
        self.zoom = (self.zoom * (1.0 + delta)).clamp(bounds.min, bounds.max);

        self.offset = (
            centered_x - content_x * self.zoom,
            centered_y - content_y * self.zoom,
        );
        self.reclamp()
    }

    pub fn apply_pan(&mut self, dx: f32, dy: f32) -> ViewChange {
        self.offset.0 += dx;
        self.offset.1 += dy;
        self.reclamp()
    }

    /// Back to the default framing: unzoomed (or container-filling for small
    /// canvases) and centered.
    pub fn reset(&mut self) -> ViewChange {
        self.zoom = self.fit_zoom().max(1.0).min(MAX_ZOOM);
        self.offset = (0.0, 0.0);
        self.reclamp()
    }

    /// Where the canvas lands inside the container this frame.
    pub fn presented_rect(&self) -> PresentedRect {
        let (cw, ch) = self.container;
        let width = self.canvas.0 * self.zoom;
        let height = self.canvas.1 * self.zoom;
        PresentedRect {
            x: cw * 0.5 + self.offset.0 - width * 0.5,
            y: ch * 0.5 + self.offset.1 - height * 0.5,
            width,
            height,
        }
    }

    pub fn view_state(&self) -> ViewState {
        ViewState {
            offset: ViewOffset {
                x: self.offset.0,
                y: self.offset.1,
            },
            zoom: self.zoom,
            pan_zoom_enabled: self.pan_zoom_enabled,
        }
    }

    pub fn apply_view_state(&mut self, state: &ViewState) -> ViewChange {
        self.offset = (state.offset.x, state.offset.y);
        let bounds = self.zoom_bounds();
        self.zoom = state.zoom.clamp(bounds.min, bounds.max);
        self.pan_zoom_enabled = state.pan_zoom_enabled;
        self.reclamp()
    }

    fn reclamp(&mut self) -> ViewChange {
        let bounds = self.zoom_bounds();
        self.zoom = self.zoom.clamp(bounds.min, bounds.max);
        self.offset = self.pan_bounds().clamp(self.offset.0, self.offset.1);
        ViewChange {
            offset: self.offset,
            zoom: self.zoom,
        }
    }
}

fn to_f32(size: (u32, u32)) -> (f32, f32) {
    (size.0.max(1) as f32, size.1.max(1) as f32)
}
