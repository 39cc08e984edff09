use winit::window::{Window, WindowId};

use crate::backend::BackendKind;
use crate::render::{RenderQueue, Renderable};

/// Per-window handles and immutable window metadata.
pub struct WindowCtx<'a> {
    pub id: WindowId,
    pub window: &'a Window,
}

impl<'a> WindowCtx<'a> {
    /// Returns the physical window size as `(width, height)`.
    pub fn physical_size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }

    /// Returns the logical window size as `(width, height)` in logical pixels.
    pub fn logical_size(&self) -> (f32, f32) {
        let phys = self.window.inner_size();
        let scale = self.window.scale_factor();
        let logi: winit::dpi::LogicalSize<f64> = phys.to_logical(scale);
        (logi.width as f32, logi.height as f32)
    }
}

/// Per-frame context passed to [`App::on_frame`](super::App::on_frame).
///
/// Renderables submitted here are drawn in submission order by the frame
/// that follows and discarded afterwards.
pub struct FrameCtx<'a> {
    pub window: WindowCtx<'a>,
    pub backend: BackendKind,

    /// Index of the frame about to be rendered.
    pub frame_index: u64,

    pub queue: &'a mut RenderQueue,
}

impl<'a> FrameCtx<'a> {
    #[inline]
    pub fn submit(&mut self, renderable: Renderable) {
        self.queue.submit(renderable);
    }
}
