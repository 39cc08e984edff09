use winit::event::WindowEvent;
use winit::window::WindowId;

use crate::render::{FrameReport, ResourceBinder};

use super::ctx::FrameCtx;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract implemented by higher layers.
pub trait App {
    /// Called for window events.
    fn on_window_event(&mut self, window_id: WindowId, event: &WindowEvent) -> AppControl {
        let _ = (window_id, event);
        AppControl::Continue
    }

    /// Called once per frame, before rendering. Submit this frame's
    /// renderables through `ctx`.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_>) -> AppControl;

    /// Binder used for every renderable of the frame.
    fn binder(&mut self) -> &mut dyn ResourceBinder;

    /// Called after the frame was rendered. Device recreation, if the report
    /// asks for it, happens after this returns.
    fn on_frame_rendered(&mut self, report: &FrameReport) -> AppControl {
        let _ = report;
        AppControl::Continue
    }
}
