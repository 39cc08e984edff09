//! OpenGL backend over WGL.
//!
//! There is no scene bracketing: begin/end frame are no-ops. Presentation is
//! `SwapBuffers` on the window's device context, and GL errors are polled
//! with `glGetError` after every state call.

mod api;
mod core;

pub use api::{
    ClearMask, DcHandle, GlCapability, GlError, GlrcHandle, PixelFormatDescriptor, PixelFormatId,
    PixelType, WglApi, WinError,
};
pub use core::OpenGlCore;
