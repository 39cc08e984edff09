use std::fmt;
use std::num::{NonZeroU32, NonZeroU64};
use std::ops::BitOr;

use crate::backend::{DepthFunc, DeviceConfig, DeviceFault, WindowHandle};

/// Window device context (`HDC`).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct DcHandle(NonZeroU64);

/// OpenGL rendering context (`HGLRC`).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct GlrcHandle(NonZeroU64);

impl DcHandle {
    #[inline]
    pub const fn new(raw: NonZeroU64) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0.get()
    }
}

impl GlrcHandle {
    #[inline]
    pub const fn new(raw: NonZeroU64) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0.get()
    }
}

/// 1-based pixel format index returned by `ChoosePixelFormat`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct PixelFormatId(pub NonZeroU32);

/// Windows error code captured from `GetLastError`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct WinError {
    pub code: u32,
}

impl WinError {
    pub const INVALID_HANDLE: u32 = 6;
    pub const NOT_ENOUGH_MEMORY: u32 = 8;
    pub const OUTOFMEMORY: u32 = 14;
    pub const NOT_SUPPORTED: u32 = 50;
    pub const INVALID_PIXEL_FORMAT: u32 = 2000;
    pub const DEVICE_NOT_CONNECTED: u32 = 1167;

    #[inline]
    pub const fn new(code: u32) -> Self {
        Self { code }
    }

    pub fn fault(&self) -> DeviceFault {
        match self.code {
            Self::NOT_ENOUGH_MEMORY | Self::OUTOFMEMORY => DeviceFault::OutOfMemory,
            Self::DEVICE_NOT_CONNECTED => DeviceFault::Lost,
            _ => DeviceFault::Failed,
        }
    }
}

impl fmt::Display for WinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self.code {
            Self::INVALID_HANDLE => "The handle is invalid.",
            Self::NOT_ENOUGH_MEMORY | Self::OUTOFMEMORY => {
                "Not enough memory resources are available to complete this operation."
            }
            Self::NOT_SUPPORTED => "The request is not supported.",
            Self::INVALID_PIXEL_FORMAT => "The pixel format is invalid.",
            Self::DEVICE_NOT_CONNECTED => "The device is not connected.",
            _ => "Unknown error.",
        };
        write!(f, "{text} (error {})", self.code)
    }
}

impl std::error::Error for WinError {}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PixelType {
    Rgba,
    ColorIndex,
}

/// Requested pixel format (`PIXELFORMATDESCRIPTOR`).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PixelFormatDescriptor {
    pub support_opengl: bool,
    pub draw_to_window: bool,
    pub double_buffer: bool,
    pub pixel_type: PixelType,
    pub color_bits: u8,
    pub depth_bits: u8,
    pub main_plane: bool,
}

impl PixelFormatDescriptor {
    pub fn from_config(config: &DeviceConfig) -> Self {
        Self {
            support_opengl: true,
            draw_to_window: config.windowed,
            double_buffer: config.back_buffer_count >= 1,
            pixel_type: PixelType::Rgba,
            color_bits: config.color_bits,
            depth_bits: config.depth_bits,
            main_plane: true,
        }
    }
}

/// Server-side capabilities toggled with `glEnable`/`glDisable`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum GlCapability {
    DepthTest,
    CullFace,
}

/// Value returned by `glGetError`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum GlError {
    NoError,
    InvalidEnum,
    InvalidValue,
    InvalidOperation,
    StackOverflow,
    StackUnderflow,
    OutOfMemory,
    InvalidFramebufferOperation,
    ContextLost,
}

impl GlError {
    pub const fn code(self) -> u32 {
        match self {
            GlError::NoError => 0,
            GlError::InvalidEnum => 0x0500,
            GlError::InvalidValue => 0x0501,
            GlError::InvalidOperation => 0x0502,
            GlError::StackOverflow => 0x0503,
            GlError::StackUnderflow => 0x0504,
            GlError::OutOfMemory => 0x0505,
            GlError::InvalidFramebufferOperation => 0x0506,
            GlError::ContextLost => 0x0507,
        }
    }

    /// Human-readable text in the style of `gluErrorString`.
    pub const fn description(self) -> &'static str {
        match self {
            GlError::NoError => "no error",
            GlError::InvalidEnum => "invalid enumerant",
            GlError::InvalidValue => "invalid value",
            GlError::InvalidOperation => "invalid operation",
            GlError::StackOverflow => "stack overflow",
            GlError::StackUnderflow => "stack underflow",
            GlError::OutOfMemory => "out of memory",
            GlError::InvalidFramebufferOperation => "invalid framebuffer operation",
            GlError::ContextLost => "context lost",
        }
    }

    #[inline]
    pub const fn is_error(self) -> bool {
        !matches!(self, GlError::NoError)
    }

    pub fn fault(self) -> DeviceFault {
        match self {
            GlError::OutOfMemory => DeviceFault::OutOfMemory,
            GlError::ContextLost => DeviceFault::Lost,
            _ => DeviceFault::Failed,
        }
    }
}

impl fmt::Display for GlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:04X})", self.description(), self.code())
    }
}

/// Buffers affected by `glClear`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ClearMask(u32);

impl ClearMask {
    pub const DEPTH: ClearMask = ClearMask(0x0000_0100);
    pub const STENCIL: ClearMask = ClearMask(0x0000_0400);
    pub const COLOR: ClearMask = ClearMask(0x0000_4000);

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn contains(self, other: ClearMask) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for ClearMask {
    type Output = ClearMask;

    fn bitor(self, rhs: ClearMask) -> ClearMask {
        ClearMask(self.0 | rhs.0)
    }
}

/// The WGL + OpenGL 1.1 slice the backend drives.
///
/// Window-system calls report failure through [`WinError`]. GL state calls
/// return nothing; errors queue up and are polled with [`WglApi::get_error`]
/// after each call, the way the GL error model works.
pub trait WglApi {
    /// `GetDC`. `None` when the window has no device context.
    fn get_dc(&mut self, window: WindowHandle) -> Option<DcHandle>;

    /// `ReleaseDC`. Returns `false` if the context was not released.
    fn release_dc(&mut self, window: WindowHandle, dc: DcHandle) -> bool;

    fn choose_pixel_format(
        &mut self,
        dc: DcHandle,
        descriptor: &PixelFormatDescriptor,
    ) -> Result<PixelFormatId, WinError>;

    fn set_pixel_format(
        &mut self,
        dc: DcHandle,
        format: PixelFormatId,
        descriptor: &PixelFormatDescriptor,
    ) -> Result<(), WinError>;

    fn create_context(&mut self, dc: DcHandle) -> Result<GlrcHandle, WinError>;

    /// Binds `context` to the calling thread; `None` unbinds.
    fn make_current(&mut self, dc: DcHandle, context: Option<GlrcHandle>) -> Result<(), WinError>;

    fn delete_context(&mut self, context: GlrcHandle) -> Result<(), WinError>;

    /// Resolves extension entry points for the current context.
    fn load_extensions(&mut self) -> Result<(), String>;

    fn swap_buffers(&mut self, dc: DcHandle) -> Result<(), WinError>;

    fn enable(&mut self, capability: GlCapability);

    fn disable(&mut self, capability: GlCapability);

    fn depth_mask(&mut self, write: bool);

    fn depth_func(&mut self, func: DepthFunc);

    fn clear_color(&mut self, r: f32, g: f32, b: f32, a: f32);

    fn clear_depth(&mut self, depth: f64);

    fn clear(&mut self, mask: ClearMask);

    /// Pops the oldest queued error, or `NoError`.
    fn get_error(&mut self) -> GlError;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gl_error_codes() {
        assert_eq!(GlError::NoError.code(), 0);
        assert_eq!(GlError::OutOfMemory.code(), 0x0505);
        assert!(!GlError::NoError.is_error());
        assert_eq!(GlError::OutOfMemory.fault(), DeviceFault::OutOfMemory);
        assert_eq!(GlError::ContextLost.fault(), DeviceFault::Lost);
        assert_eq!(GlError::InvalidEnum.to_string(), "invalid enumerant (0x0500)");
    }

    #[test]
    fn pixel_format_follows_default_config() {
        let pfd = PixelFormatDescriptor::from_config(&DeviceConfig::default());
        assert!(pfd.support_opengl && pfd.draw_to_window && pfd.double_buffer);
        assert_eq!(pfd.pixel_type, PixelType::Rgba);
        assert_eq!(pfd.color_bits, 32);
        assert_eq!(pfd.depth_bits, 16);
    }

    #[test]
    fn win_error_classification() {
        assert_eq!(WinError::new(WinError::OUTOFMEMORY).fault(), DeviceFault::OutOfMemory);
        assert_eq!(WinError::new(WinError::DEVICE_NOT_CONNECTED).fault(), DeviceFault::Lost);
        assert_eq!(WinError::new(5).fault(), DeviceFault::Failed);
    }
}
