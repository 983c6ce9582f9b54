//! Window and GL context creation via glutin.

use std::num::NonZeroU32;

use anyhow::{anyhow, Context, Result};
use glutin::config::ConfigTemplateBuilder;
use glutin::context::{ContextApi, ContextAttributesBuilder, PossiblyCurrentContext, Version};
use glutin::display::GetGlDisplay;
use glutin::prelude::*;
use glutin::surface::{Surface, SurfaceAttributesBuilder, SwapInterval, WindowSurface};
use glutin_winit::DisplayBuilder;
use raw_window_handle::HasRawWindowHandle;
use winit::dpi::PhysicalSize;
use winit::event_loop::EventLoop;
use winit::window::{Window, WindowBuilder};

pub struct GlWindow {
    pub window: Window,
    pub surface: Surface<WindowSurface>,
    pub context: PossiblyCurrentContext,
    pub gl: glow::Context,
}

impl GlWindow {
    pub fn new(event_loop: &EventLoop<()>, size: (u32, u32)) -> Result<Self> {
        let window_builder = WindowBuilder::new()
            .with_title("shaderdesk")
            .with_inner_size(PhysicalSize::new(size.0, size.1));

        let template = ConfigTemplateBuilder::new();
        let display_builder = DisplayBuilder::new().with_window_builder(Some(window_builder));
        let (window, gl_config) = display_builder
            .build(event_loop, template, |mut configs| {
                configs.next().expect("at least one GL config")
            })
            .map_err(|error| anyhow!("failed to build GL display: {error}"))?;
        let window = window.ok_or_else(|| anyhow!("display builder produced no window"))?;

        let raw_window_handle = window.raw_window_handle();
        let gl_display = gl_config.display();

        let context_attributes = ContextAttributesBuilder::new()
            .with_context_api(ContextApi::OpenGl(Some(Version::new(3, 3))))
            .build(Some(raw_window_handle));
        let not_current = unsafe {
            gl_display
                .create_context(&gl_config, &context_attributes)
                .context("failed to create GL 3.3 context")?
        };

        let inner = window.inner_size();
        let attrs = SurfaceAttributesBuilder::<WindowSurface>::new().build(
            raw_window_handle,
            NonZeroU32::new(inner.width.max(1)).expect("non-zero width"),
            NonZeroU32::new(inner.height.max(1)).expect("non-zero height"),
        );
        let surface = unsafe {
            gl_display
                .create_window_surface(&gl_config, &attrs)
                .context("failed to create window surface")?
        };
        let context = not_current
            .make_current(&surface)
            .context("failed to make GL context current")?;

        if let Err(error) = surface.set_swap_interval(
            &context,
            SwapInterval::Wait(NonZeroU32::new(1).expect("non-zero interval")),
        ) {
            tracing::warn!(error = %error, "vsync unavailable; continuing without");
        }

        let gl = unsafe {
            glow::Context::from_loader_function_cstr(|symbol| gl_display.get_proc_address(symbol))
        };

        Ok(Self {
            window,
            surface,
            context,
            gl,
        })
    }

    pub fn resize(&self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.surface.resize(
            &self.context,
            NonZeroU32::new(width).expect("non-zero width"),
            NonZeroU32::new(height).expect("non-zero height"),
        );
    }

    pub fn swap(&self) -> Result<()> {
        self.surface
            .swap_buffers(&self.context)
            .context("failed to swap buffers")
    }
}
