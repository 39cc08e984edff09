//! Frame rendering.
//!
//! [`Renderer`] owns a backend ([`crate::backend::Core`]) and runs the fixed
//! per-frame protocol over a [`RenderableSource`]:
//!
//! 1. clear color + depth
//! 2. begin frame
//! 3. for every renderable: bind effect, material uniforms, material
//!    textures, draw-call uniforms, draw mesh ([`ResourceBinder`])
//! 4. discard the source's transient entries
//! 5. end frame, present
//!
//! Failures go to a [`DiagnosticSink`] once each and are summarized in the
//! returned [`FrameReport`].

mod binder;
mod diagnostics;
mod frame;
mod renderer;
mod source;

pub use binder::{EffectHandle, MaterialHandle, MeshHandle, Renderable, ResourceBinder};
pub use diagnostics::{DiagnosticSink, LogSink, MessageLog};
pub use frame::FrameReport;
pub use renderer::Renderer;
pub use source::{RenderQueue, RenderableSource};
