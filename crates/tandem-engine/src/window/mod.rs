//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and Window, and wires them to a [`Renderer`]
//! over the GPU drivers.
//!
//! [`Renderer`]: crate::render::Renderer

mod runtime;

pub use runtime::{Runtime, RuntimeConfig};
