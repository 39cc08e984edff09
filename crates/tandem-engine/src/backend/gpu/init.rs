use crate::backend::{AdapterSelection, BackendKind, DeviceConfig, PresentInterval};

/// Initialization parameters for the wgpu drivers.
///
/// Keep this structure stable and minimal. Add configuration flags only when a
/// concrete platform or backend requirement exists.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// wgpu backends the instance may use.
    pub backends: wgpu::Backends,

    /// Prefer an sRGB surface format when available.
    pub prefer_srgb: bool,

    /// Present mode (swap behavior).
    pub present_mode: wgpu::PresentMode,

    /// Optional alpha mode preference for the surface.
    ///
    /// If provided but unsupported on the current surface, a supported mode is selected.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    /// Request a software adapter instead of real hardware.
    pub force_fallback_adapter: bool,

    /// Required wgpu features.
    pub required_features: wgpu::Features,

    /// Limits requested from the adapter/device.
    pub required_limits: wgpu::Limits,

    /// Desired maximum frame latency for the surface.
    ///
    /// This value is a hint; support depends on platform/backend.
    pub desired_maximum_frame_latency: u32,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            prefer_srgb: false,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            force_fallback_adapter: false,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::downlevel_webgl2_defaults(),
            desired_maximum_frame_latency: 2,
        }
    }
}

impl GpuInit {
    /// Parameters for one API shape.
    ///
    /// `WGPU_BACKEND` overrides the backends picked by [`native_backends`].
    pub fn for_backend(kind: BackendKind, config: &DeviceConfig) -> Self {
        let native = native_backends(kind);
        Self {
            backends: wgpu::Backends::from_env().unwrap_or(native),
            present_mode: present_mode(config.present_interval),
            force_fallback_adapter: config.adapter == AdapterSelection::Fallback
                || !config.hardware_acceleration,
            desired_maximum_frame_latency: config.back_buffer_count.clamp(1, 3),
            ..Self::default()
        }
    }
}

/// Backends that stand in for each API shape on this platform.
///
/// The Direct3D9 shape runs on DX12 where it exists and on the platform's
/// primary backend (Vulkan or Metal) elsewhere. The OpenGL shape runs on GL.
pub fn native_backends(kind: BackendKind) -> wgpu::Backends {
    match kind {
        BackendKind::Direct3D9 if cfg!(windows) => wgpu::Backends::DX12,
        BackendKind::Direct3D9 => wgpu::Backends::PRIMARY,
        BackendKind::OpenGl => wgpu::Backends::GL,
    }
}

pub(crate) fn present_mode(interval: PresentInterval) -> wgpu::PresentMode {
    match interval {
        PresentInterval::Default | PresentInterval::One => wgpu::PresentMode::Fifo,
        PresentInterval::Immediate => wgpu::PresentMode::AutoNoVsync,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vsync_unless_immediate() {
        assert_eq!(present_mode(PresentInterval::Default), wgpu::PresentMode::Fifo);
        assert_eq!(present_mode(PresentInterval::One), wgpu::PresentMode::Fifo);
        assert_eq!(present_mode(PresentInterval::Immediate), wgpu::PresentMode::AutoNoVsync);
    }

    #[test]
    fn direct3d9_shape_has_an_adapter_source_off_windows() {
        let backends = native_backends(BackendKind::Direct3D9);
        if cfg!(windows) {
            assert_eq!(backends, wgpu::Backends::DX12);
        } else {
            assert!(backends.contains(wgpu::Backends::VULKAN | wgpu::Backends::METAL));
        }
        assert_eq!(native_backends(BackendKind::OpenGl), wgpu::Backends::GL);
    }

    #[test]
    fn software_rasterization_requests_fallback_adapter() {
        let config = DeviceConfig {
            hardware_acceleration: false,
            ..DeviceConfig::default()
        };
        assert!(GpuInit::for_backend(BackendKind::OpenGl, &config).force_fallback_adapter);
        assert!(!GpuInit::for_backend(BackendKind::OpenGl, &DeviceConfig::default()).force_fallback_adapter);
    }
}
