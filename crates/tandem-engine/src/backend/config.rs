use crate::paint::Color;

/// Presentation interval requested for the swap chain.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum PresentInterval {
    /// Driver default (vsync on the primary display).
    #[default]
    Default,
    /// Wait for exactly one vertical retrace.
    One,
    /// Present immediately; may tear.
    Immediate,
}

/// Which display adapter creates the device.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum AdapterSelection {
    #[default]
    Default,
    /// Prefer a software/fallback adapter. Only meaningful for the GPU drivers.
    Fallback,
}

/// Fixed device configuration used by both backends.
///
/// Keep this structure minimal. The defaults describe the only configuration
/// the render loop is tested against: windowed, double-buffered, 32-bit color,
/// 16-bit depth.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceConfig {
    pub windowed: bool,

    /// Back buffers in addition to the front buffer. 1 = double buffering.
    pub back_buffer_count: u32,

    /// Color bits per pixel.
    pub color_bits: u8,

    /// Depth-buffer bits per pixel.
    pub depth_bits: u8,

    pub present_interval: PresentInterval,

    pub adapter: AdapterSelection,

    /// Request hardware rasterization and vertex processing where available.
    pub hardware_acceleration: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            windowed: true,
            back_buffer_count: 1,
            color_bits: 32,
            depth_bits: 16,
            present_interval: PresentInterval::Default,
            adapter: AdapterSelection::Default,
            hardware_acceleration: true,
        }
    }
}

/// Depth comparison function.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum DepthFunc {
    Never,
    Less,
    Equal,
    #[default]
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

impl DepthFunc {
    /// Evaluates `incoming <op> stored`.
    pub fn passes(self, incoming: f32, stored: f32) -> bool {
        match self {
            DepthFunc::Never => false,
            DepthFunc::Less => incoming < stored,
            DepthFunc::Equal => incoming == stored,
            DepthFunc::LessEqual => incoming <= stored,
            DepthFunc::Greater => incoming > stored,
            DepthFunc::NotEqual => incoming != stored,
            DepthFunc::GreaterEqual => incoming >= stored,
            DepthFunc::Always => true,
        }
    }
}

/// Pipeline toggles applied once during initialization.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RenderStateConfig {
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_func: DepthFunc,

    /// Enable back-face culling. Honored by the OpenGL backend only; the
    /// Direct3D9 device culls counter-clockwise faces by default.
    pub cull_back_faces: bool,
}

impl Default for RenderStateConfig {
    fn default() -> Self {
        Self {
            depth_test: true,
            depth_write: true,
            depth_func: DepthFunc::LessEqual,
            cull_back_faces: true,
        }
    }
}

/// Renderer-level configuration: backend setup plus the per-frame clear values.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    pub device: DeviceConfig,
    pub render_state: RenderStateConfig,
    pub clear_color: Color,

    /// Normalized depth written by the clear; 1.0 is the far plane.
    pub clear_depth: f32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            device: DeviceConfig::default(),
            render_state: RenderStateConfig::default(),
            clear_color: Color::black(),
            clear_depth: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_fixed_configuration() {
        let d = DeviceConfig::default();
        assert!(d.windowed);
        assert_eq!(d.back_buffer_count, 1);
        assert_eq!(d.color_bits, 32);
        assert_eq!(d.depth_bits, 16);

        let r = RendererConfig::default();
        assert_eq!(r.clear_color, Color::black());
        assert_eq!(r.clear_depth, 1.0);
        assert_eq!(r.render_state.depth_func, DepthFunc::LessEqual);
    }

    #[test]
    fn less_equal_accepts_equal_depth() {
        assert!(DepthFunc::LessEqual.passes(1.0, 1.0));
        assert!(!DepthFunc::Less.passes(1.0, 1.0));
        assert!(!DepthFunc::LessEqual.passes(0.75, 0.5));
    }
}
