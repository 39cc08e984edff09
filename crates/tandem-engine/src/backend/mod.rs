//! Backend abstraction.
//!
//! A backend owns one native graphics device and exposes the fixed
//! lifecycle + per-frame contract in [`Core`]. Two implementations exist:
//! - [`d3d9::Direct3D9Core`], driving a Direct3D9-shaped API ([`d3d9::D3d9Api`])
//! - [`opengl::OpenGlCore`], driving a WGL/OpenGL-shaped API ([`opengl::WglApi`])
//!
//! Each is generic over its native API so the same backend logic runs against
//! the CPU [`software`] drivers and the GPU [`gpu`] drivers.

mod config;
mod context;
mod error;
mod lifecycle;
mod rollback;

pub mod d3d9;
pub mod gpu;
pub mod opengl;
pub mod software;

use std::fmt;

pub use config::{
    AdapterSelection, DepthFunc, DeviceConfig, PresentInterval, RenderStateConfig, RendererConfig,
};
pub use context::{Context, WindowHandle};
pub use error::{
    BindStep, DeviceFault, FrameError, FrameStage, InitError, InitStage, RecoveryAction,
    ShutdownError,
};
pub use lifecycle::{LifecycleEvent, LifecycleState};
pub use rollback::Rollback;

use crate::paint::Color;

/// Graphics API family a backend targets.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BackendKind {
    Direct3D9,
    OpenGl,
}

impl BackendKind {
    pub const ALL: [BackendKind; 2] = [BackendKind::Direct3D9, BackendKind::OpenGl];
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BackendKind::Direct3D9 => "Direct3D9",
            BackendKind::OpenGl => "OpenGL",
        })
    }
}

/// Backend contract shared by every graphics API.
///
/// Lifecycle and state tracking live in [`crate::render::Renderer`]; a backend
/// only has to honor these rules:
/// - `initialize` either returns a live [`Context`] or leaves nothing acquired
/// - per-frame calls are only made between a successful `initialize` and `shutdown`
/// - `shutdown` releases everything it can and is a no-op when nothing is held
pub trait Core {
    fn kind(&self) -> BackendKind;

    /// Acquires the surface, creates the device, applies the one-time render
    /// state and returns the context for the new device.
    fn initialize(&mut self, window: WindowHandle) -> Result<Context, InitError>;

    /// Clears color and depth in one device operation. No stencil.
    fn clear(&mut self, color: Color, depth: f32, context: Context) -> Result<(), FrameError>;

    /// Starts command submission to the back buffer.
    fn begin_frame(&mut self, context: Context) -> Result<(), FrameError>;

    /// Ends command submission; mirrors `begin_frame`.
    fn end_frame(&mut self, context: Context) -> Result<(), FrameError>;

    /// Swaps the back buffer into view.
    fn present(&mut self, context: Context) -> Result<(), FrameError>;

    /// Releases the device, then the surface/interface.
    fn shutdown(&mut self) -> Result<(), ShutdownError>;
}

impl<C: Core + ?Sized> Core for Box<C> {
    fn kind(&self) -> BackendKind {
        (**self).kind()
    }

    fn initialize(&mut self, window: WindowHandle) -> Result<Context, InitError> {
        (**self).initialize(window)
    }

    fn clear(&mut self, color: Color, depth: f32, context: Context) -> Result<(), FrameError> {
        (**self).clear(color, depth, context)
    }

    fn begin_frame(&mut self, context: Context) -> Result<(), FrameError> {
        (**self).begin_frame(context)
    }

    fn end_frame(&mut self, context: Context) -> Result<(), FrameError> {
        (**self).end_frame(context)
    }

    fn present(&mut self, context: Context) -> Result<(), FrameError> {
        (**self).present(context)
    }

    fn shutdown(&mut self) -> Result<(), ShutdownError> {
        (**self).shutdown()
    }
}

/// Message used when a per-frame call arrives with a context that does not
/// belong to the live device.
pub(crate) fn stale_context(stage: FrameStage, context: Context) -> FrameError {
    FrameError::device(
        stage,
        DeviceFault::Failed,
        format!("{context:?} does not belong to the live device"),
    )
}
