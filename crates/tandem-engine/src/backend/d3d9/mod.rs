//! Direct3D9 backend.
//!
//! Scene bracketing maps to `BeginScene`/`EndScene`, presentation to the
//! device's `Present`, and every call reports status through an [`HResult`].

mod api;
mod core;

pub use api::{
    BackBufferFormat, ClearFlags, D3d9Api, D3dRenderState, DepthStencilFormat, DeviceCreation,
    DeviceHandle, DeviceType, HResult, InterfaceHandle, PresentParameters, SwapEffect,
    VertexProcessing, ADAPTER_DEFAULT,
};
pub use core::Direct3D9Core;
