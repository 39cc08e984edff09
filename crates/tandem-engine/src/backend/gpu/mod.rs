//! wgpu drivers for both native API shapes.
//!
//! - [`WgpuD3d9`] implements [`D3d9Api`](super::d3d9::D3d9Api), on DX12 on Windows and Vulkan or Metal elsewhere
//! - [`WgpuWgl`] implements [`WglApi`](super::opengl::WglApi), on GL by default
//!
//! Both present to a single window shared through an `Arc`.

mod d3d9;
mod device;
mod init;
mod surface;
mod wgl;

use std::sync::Arc;

use winit::window::Window;

pub use d3d9::WgpuD3d9;
pub use device::{DepthState, WgpuDevice};
pub use init::{native_backends, GpuInit};
pub use wgl::WgpuWgl;

use super::d3d9::Direct3D9Core;
use super::opengl::OpenGlCore;
use super::{BackendKind, Core, RendererConfig};

/// Builds the backend for `kind` over the wgpu driver presenting to `window`.
pub fn create_core(kind: BackendKind, window: Arc<Window>, config: &RendererConfig) -> Box<dyn Core> {
    let init = GpuInit::for_backend(kind, &config.device);
    log::debug!("{kind} backend on wgpu backends {:?}", init.backends);
    match kind {
        BackendKind::Direct3D9 => Box::new(Direct3D9Core::new(
            WgpuD3d9::new(window, init),
            config.device.clone(),
            config.render_state,
        )),
        BackendKind::OpenGl => Box::new(OpenGlCore::new(
            WgpuWgl::new(window, init),
            config.device.clone(),
            config.render_state,
        )),
    }
}
