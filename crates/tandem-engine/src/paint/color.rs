use bytemuck::{Pod, Zeroable};

/// Normalized RGBA clear color.
///
/// Channels are straight (not premultiplied) and expected in `[0, 1]`. Values
/// outside that range are clamped when converted to a native representation.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque black, the default clear color.
    #[inline]
    pub const fn black() -> Self {
        Self::new(0.0, 0.0, 0.0, 1.0)
    }

    #[inline]
    pub const fn white() -> Self {
        Self::new(1.0, 1.0, 1.0, 1.0)
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.r.is_finite() && self.g.is_finite() && self.b.is_finite() && self.a.is_finite()
    }

    /// Converts to 8-bit channels using `round(clamp(x, 0, 1) * 255)`.
    #[inline]
    pub fn to_rgba8(self) -> Rgba8 {
        Rgba8 {
            r: unorm_to_u8(self.r),
            g: unorm_to_u8(self.g),
            b: unorm_to_u8(self.b),
            a: unorm_to_u8(self.a),
        }
    }

    /// Widens to the `f64` color type wgpu load operations expect.
    #[inline]
    pub fn to_wgpu(self) -> wgpu::Color {
        wgpu::Color {
            r: self.r.clamp(0.0, 1.0) as f64,
            g: self.g.clamp(0.0, 1.0) as f64,
            b: self.b.clamp(0.0, 1.0) as f64,
            a: self.a.clamp(0.0, 1.0) as f64,
        }
    }
}

/// One 32-bit pixel with 8-bit RGBA channels.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    #[inline]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Packs the channels in Direct3D `D3DCOLOR` order (`0xAARRGGBB`).
    #[inline]
    pub const fn to_argb(self) -> u32 {
        ((self.a as u32) << 24) | ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    #[inline]
    pub const fn from_argb(argb: u32) -> Self {
        Self {
            a: (argb >> 24) as u8,
            r: (argb >> 16) as u8,
            g: (argb >> 8) as u8,
            b: argb as u8,
        }
    }

    #[inline]
    pub fn to_color(self) -> Color {
        Color::new(
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        )
    }
}

/// Maps a normalized channel to `0..=255`. NaN maps to 0.
#[inline]
pub fn unorm_to_u8(x: f32) -> u8 {
    if x.is_nan() {
        return 0;
    }
    (x.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unorm_endpoints() {
        assert_eq!(unorm_to_u8(0.0), 0);
        assert_eq!(unorm_to_u8(1.0), 255);
    }

    #[test]
    fn unorm_rounds_to_nearest() {
        // 0.5 * 255 = 127.5 rounds away from zero.
        assert_eq!(unorm_to_u8(0.5), 128);
        assert_eq!(unorm_to_u8(0.2), 51);
    }

    #[test]
    fn unorm_clamps_out_of_range() {
        assert_eq!(unorm_to_u8(-3.0), 0);
        assert_eq!(unorm_to_u8(7.5), 255);
        assert_eq!(unorm_to_u8(f32::NAN), 0);
    }

    #[test]
    fn black_packs_to_opaque_argb() {
        assert_eq!(Color::black().to_rgba8().to_argb(), 0xFF00_0000);
    }

    #[test]
    fn argb_unpacks_channels() {
        let px = Rgba8::from_argb(0x80FF_4020);
        assert_eq!(px, Rgba8::new(0xFF, 0x40, 0x20, 0x80));
        assert_eq!(px.to_argb(), 0x80FF_4020);
    }
}
