use std::fmt;
use std::num::NonZeroU64;
use std::ops::BitOr;

use crate::backend::{DepthFunc, DeviceConfig, DeviceFault, PresentInterval, WindowHandle};

/// COM-style status code. Negative values are failures.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct HResult(pub i32);

impl HResult {
    pub const OK: HResult = HResult(0);
    pub const E_FAIL: HResult = HResult(0x8000_4005_u32 as i32);
    pub const E_OUTOFMEMORY: HResult = HResult(0x8007_000E_u32 as i32);
    pub const D3DERR_OUTOFVIDEOMEMORY: HResult = HResult(0x8876_017C_u32 as i32);
    pub const D3DERR_DEVICELOST: HResult = HResult(0x8876_0868_u32 as i32);
    pub const D3DERR_DEVICENOTRESET: HResult = HResult(0x8876_0869_u32 as i32);
    pub const D3DERR_NOTAVAILABLE: HResult = HResult(0x8876_086A_u32 as i32);
    pub const D3DERR_INVALIDCALL: HResult = HResult(0x8876_086C_u32 as i32);

    #[inline]
    pub const fn succeeded(self) -> bool {
        self.0 >= 0
    }

    #[inline]
    pub const fn failed(self) -> bool {
        self.0 < 0
    }

    /// Classifies a failure code.
    pub fn fault(self) -> DeviceFault {
        match self {
            HResult::D3DERR_DEVICELOST | HResult::D3DERR_DEVICENOTRESET => DeviceFault::Lost,
            HResult::D3DERR_OUTOFVIDEOMEMORY | HResult::E_OUTOFMEMORY => DeviceFault::OutOfMemory,
            _ => DeviceFault::Failed,
        }
    }

    fn name(self) -> Option<&'static str> {
        Some(match self {
            HResult::OK => "S_OK",
            HResult::E_FAIL => "E_FAIL",
            HResult::E_OUTOFMEMORY => "E_OUTOFMEMORY",
            HResult::D3DERR_OUTOFVIDEOMEMORY => "D3DERR_OUTOFVIDEOMEMORY",
            HResult::D3DERR_DEVICELOST => "D3DERR_DEVICELOST",
            HResult::D3DERR_DEVICENOTRESET => "D3DERR_DEVICENOTRESET",
            HResult::D3DERR_NOTAVAILABLE => "D3DERR_NOTAVAILABLE",
            HResult::D3DERR_INVALIDCALL => "D3DERR_INVALIDCALL",
            _ => return None,
        })
    }
}

impl fmt::Debug for HResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HResult({self})")
    }
}

impl fmt::Display for HResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name} (0x{:08X})", self.0 as u32),
            None => write!(f, "0x{:08X}", self.0 as u32),
        }
    }
}

/// Handle to the API entry object (`IDirect3D9`).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct InterfaceHandle(NonZeroU64);

/// Handle to a rendering device (`IDirect3DDevice9`).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct DeviceHandle(NonZeroU64);

macro_rules! handle_impl {
    ($t:ty) => {
        impl $t {
            #[inline]
            pub const fn new(raw: NonZeroU64) -> Self {
                Self(raw)
            }

            #[inline]
            pub const fn raw(self) -> u64 {
                self.0.get()
            }
        }
    };
}

handle_impl!(InterfaceHandle);
handle_impl!(DeviceHandle);

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BackBufferFormat {
    /// 32-bit, 8 bits per color channel, unused alpha.
    X8R8G8B8,
    /// 16-bit color.
    R5G6B5,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DepthStencilFormat {
    D16,
    D24X8,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SwapEffect {
    Discard,
    Flip,
    Copy,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DeviceType {
    /// Hardware rasterization.
    Hal,
    /// Reference rasterizer.
    Reference,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum VertexProcessing {
    Hardware,
    Software,
}

/// Adapter ordinal of the primary display adapter.
pub const ADAPTER_DEFAULT: u32 = 0;

/// Device creation arguments besides the presentation parameters.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DeviceCreation {
    pub adapter: u32,
    pub device_type: DeviceType,
    pub vertex_processing: VertexProcessing,
}

impl DeviceCreation {
    pub fn from_config(config: &DeviceConfig) -> Self {
        let (device_type, vertex_processing) = if config.hardware_acceleration {
            (DeviceType::Hal, VertexProcessing::Hardware)
        } else {
            (DeviceType::Reference, VertexProcessing::Software)
        };
        Self {
            adapter: ADAPTER_DEFAULT,
            device_type,
            vertex_processing,
        }
    }
}

/// Swap-chain description (`D3DPRESENT_PARAMETERS`).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PresentParameters {
    /// 0 = use the window's client size.
    pub back_buffer_width: u32,
    pub back_buffer_height: u32,
    pub back_buffer_format: BackBufferFormat,
    pub back_buffer_count: u32,
    /// 0 = no multisampling.
    pub multisample_count: u32,
    pub swap_effect: SwapEffect,
    pub device_window: WindowHandle,
    pub windowed: bool,
    pub enable_auto_depth_stencil: bool,
    pub auto_depth_stencil_format: DepthStencilFormat,
    pub presentation_interval: PresentInterval,
}

impl PresentParameters {
    pub fn from_config(window: WindowHandle, config: &DeviceConfig) -> Self {
        let back_buffer_format = if config.color_bits >= 24 {
            BackBufferFormat::X8R8G8B8
        } else {
            BackBufferFormat::R5G6B5
        };
        let auto_depth_stencil_format = if config.depth_bits > 16 {
            DepthStencilFormat::D24X8
        } else {
            DepthStencilFormat::D16
        };

        Self {
            back_buffer_width: 0,
            back_buffer_height: 0,
            back_buffer_format,
            back_buffer_count: config.back_buffer_count,
            multisample_count: 0,
            swap_effect: SwapEffect::Discard,
            device_window: window,
            windowed: config.windowed,
            enable_auto_depth_stencil: true,
            auto_depth_stencil_format,
            presentation_interval: config.present_interval,
        }
    }
}

/// Render states the backend touches.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum D3dRenderState {
    ZEnable(bool),
    ZWriteEnable(bool),
    ZFunc(DepthFunc),
}

/// Buffers affected by [`D3d9Api::clear`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ClearFlags(u32);

impl ClearFlags {
    pub const TARGET: ClearFlags = ClearFlags(0x1);
    pub const ZBUFFER: ClearFlags = ClearFlags(0x2);
    pub const STENCIL: ClearFlags = ClearFlags(0x4);

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn contains(self, other: ClearFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for ClearFlags {
    type Output = ClearFlags;

    fn bitor(self, rhs: ClearFlags) -> ClearFlags {
        ClearFlags(self.0 | rhs.0)
    }
}

/// The slice of the Direct3D9 API the backend drives.
///
/// Calls report status the Direct3D way: through [`HResult`] return codes,
/// with creation functions returning the handle or the failing code.
pub trait D3d9Api {
    /// `Direct3DCreate9`. `None` when the runtime is unavailable.
    fn create_interface(&mut self) -> Option<InterfaceHandle>;

    fn create_device(
        &mut self,
        interface: InterfaceHandle,
        creation: &DeviceCreation,
        params: &PresentParameters,
    ) -> Result<DeviceHandle, HResult>;

    fn set_render_state(&mut self, device: DeviceHandle, state: D3dRenderState) -> HResult;

    /// Clears the whole render target. `color` is packed `0xAARRGGBB`.
    fn clear(
        &mut self,
        device: DeviceHandle,
        flags: ClearFlags,
        color: u32,
        z: f32,
        stencil: u32,
    ) -> HResult;

    fn begin_scene(&mut self, device: DeviceHandle) -> HResult;

    fn end_scene(&mut self, device: DeviceHandle) -> HResult;

    /// Presents the back buffer to the device window.
    fn present(&mut self, device: DeviceHandle) -> HResult;

    /// Binds a vertex declaration; `None` detaches the current one.
    fn set_vertex_declaration(&mut self, device: DeviceHandle, declaration: Option<u64>)
    -> HResult;

    /// Drops one reference; returns the remaining reference count.
    fn release_device(&mut self, device: DeviceHandle) -> u32;

    /// Drops one reference; returns the remaining reference count.
    fn release_interface(&mut self, interface: InterfaceHandle) -> u32;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hresult_sign_decides_success() {
        assert!(HResult::OK.succeeded());
        assert!(HResult(1).succeeded());
        assert!(HResult::E_FAIL.failed());
    }

    #[test]
    fn hresult_classification() {
        assert_eq!(HResult::D3DERR_DEVICELOST.fault(), DeviceFault::Lost);
        assert_eq!(HResult::D3DERR_OUTOFVIDEOMEMORY.fault(), DeviceFault::OutOfMemory);
        assert_eq!(HResult::D3DERR_INVALIDCALL.fault(), DeviceFault::Failed);
    }

    #[test]
    fn hresult_display_names_known_codes() {
        assert_eq!(
            HResult::D3DERR_DEVICELOST.to_string(),
            "D3DERR_DEVICELOST (0x88760868)"
        );
        assert_eq!(HResult(0x8000_FFFF_u32 as i32).to_string(), "0x8000FFFF");
    }

    #[test]
    fn present_parameters_follow_default_config() {
        let window = WindowHandle::new(9).unwrap();
        let p = PresentParameters::from_config(window, &DeviceConfig::default());
        assert_eq!(p.back_buffer_format, BackBufferFormat::X8R8G8B8);
        assert_eq!(p.auto_depth_stencil_format, DepthStencilFormat::D16);
        assert_eq!(p.back_buffer_count, 1);
        assert_eq!(p.swap_effect, SwapEffect::Discard);
        assert!(p.windowed);
        assert!(p.enable_auto_depth_stencil);
        assert_eq!(p.device_window, window);
    }

    #[test]
    fn clear_flags_combine() {
        let f = ClearFlags::TARGET | ClearFlags::ZBUFFER;
        assert!(f.contains(ClearFlags::TARGET));
        assert!(f.contains(ClearFlags::ZBUFFER));
        assert!(!f.contains(ClearFlags::STENCIL));
    }
}
