//! Tandem engine crate.
//!
//! A frame rendering core with two interchangeable backends, one shaped like
//! Direct3D9 and one shaped like WGL/OpenGL, behind a single [`backend::Core`]
//! contract. [`render::Renderer`] runs the lifecycle and the per-frame loop;
//! [`window::Runtime`] hosts it in a winit window.

pub mod backend;
pub mod core;
pub mod logging;
pub mod paint;
pub mod render;
pub mod window;
