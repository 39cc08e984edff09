use std::fmt;
use std::num::NonZeroU64;

/// Opaque native handle threaded through every per-frame device operation.
///
/// For the Direct3D9 backend this wraps the device handle; for the OpenGL
/// backend it wraps the window's device-context handle. The value is never
/// reference counted: its lifetime is the backend device's lifetime, and it
/// is reset to [`Context::NULL`] when the backend shuts down.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Context(u64);

impl Context {
    /// Null sentinel held while no device exists.
    pub const NULL: Context = Context(0);

    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            f.write_str("Context(null)")
        } else {
            write!(f, "Context({:#x})", self.0)
        }
    }
}

/// Opaque platform window identifier handed to initialization.
///
/// The core never creates or destroys the window itself.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct WindowHandle(NonZeroU64);

impl WindowHandle {
    /// Returns `None` for the zero id, which no platform hands out.
    #[inline]
    pub const fn new(raw: u64) -> Option<Self> {
        match NonZeroU64::new(raw) {
            Some(id) => Some(Self(id)),
            None => None,
        }
    }

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0.get()
    }
}

impl From<winit::window::WindowId> for WindowHandle {
    fn from(id: winit::window::WindowId) -> Self {
        // winit ids are opaque; zero is remapped so the handle stays non-null.
        let raw = u64::from(id);
        Self(NonZeroU64::new(raw).unwrap_or(NonZeroU64::MIN))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_sentinel() {
        assert!(Context::NULL.is_null());
        assert!(Context::default().is_null());
        assert!(!Context::from_raw(0x10).is_null());
    }

    #[test]
    fn zero_window_is_rejected() {
        assert!(WindowHandle::new(0).is_none());
        assert_eq!(WindowHandle::new(42).map(WindowHandle::raw), Some(42));
    }
}
