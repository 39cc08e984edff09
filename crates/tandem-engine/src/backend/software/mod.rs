//! CPU drivers for both native API shapes.
//!
//! Both drivers render into a shared [`SoftwareDevice`], which makes them
//! usable headless and lets tests inspect pixels, journal entries and leaked
//! objects.

mod d3d9;
mod device;
mod wgl;

pub use d3d9::SoftwareD3d9;
pub use device::{DeviceCall, Fault, FaultPoint, RasterState, SoftwareDevice};
pub use wgl::SoftwareWgl;

use super::d3d9::Direct3D9Core;
use super::opengl::OpenGlCore;
use super::{BackendKind, Core, RendererConfig};

/// Builds the backend for `kind` over a software driver rendering into `device`.
pub fn create_core(kind: BackendKind, device: SoftwareDevice, config: &RendererConfig) -> Box<dyn Core> {
    match kind {
        BackendKind::Direct3D9 => Box::new(Direct3D9Core::new(
            SoftwareD3d9::new(device),
            config.device.clone(),
            config.render_state,
        )),
        BackendKind::OpenGl => Box::new(OpenGlCore::new(
            SoftwareWgl::new(device),
            config.device.clone(),
            config.render_state,
        )),
    }
}
