//! Color values consumed by the clear operation.
//!
//! Backends convert [`Color`] to their native representation: packed
//! `D3DCOLOR` for Direct3D9, float channels for OpenGL, `wgpu::Color` for the
//! GPU drivers.

pub mod color;

pub use color::{unorm_to_u8, Color, Rgba8};
