use std::cell::{Ref, RefCell, RefMut};
use std::collections::{HashMap, HashSet, VecDeque};
use std::num::NonZeroU64;
use std::rc::Rc;

use crate::backend::opengl::{GlCapability, GlError};
use crate::backend::DepthFunc;
use crate::paint::Rgba8;

/// Native call sites that can be made to fail.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum FaultPoint {
    CreateInterface,
    CreateDevice,
    SetRenderState,
    Clear,
    BeginScene,
    EndScene,
    Present,
    SetVertexDeclaration,
    ReleaseDevice,
    ReleaseInterface,
    GetDc,
    ReleaseDc,
    ChoosePixelFormat,
    SetPixelFormat,
    CreateContext,
    MakeCurrent,
    DeleteContext,
    LoadExtensions,
    EnableCullFace,
}

/// How an injected fault surfaces through the native API.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Fault {
    Failed,
    Lost,
    OutOfMemory,
}

/// One entry of the device journal.
///
/// Frame-level calls are shared between both API shapes: `Clear` is
/// `IDirect3DDevice9::Clear` or `glClear`, `Present` is the device `Present`
/// or `SwapBuffers`.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    CreateInterface,
    CreateDevice,
    SetRenderState,
    Clear,
    BeginScene,
    EndScene,
    Present,
    SetVertexDeclaration(Option<u64>),
    ReleaseDevice,
    ReleaseInterface,
    GetDc,
    ReleaseDc,
    ChoosePixelFormat,
    SetPixelFormat,
    CreateContext,
    MakeCurrent { bind: bool },
    DeleteContext,
    LoadExtensions,
    Enable(GlCapability),
    Disable(GlCapability),
    DepthMask(bool),
    DepthFunc(DepthFunc),
    ClearColor,
    ClearDepth,
    /// Free-form entry written by code outside the driver, e.g. a binder.
    Note(String),
}

/// Fixed-function state the rasterizer honors.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RasterState {
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_func: DepthFunc,
    pub cull_back_faces: bool,
}

impl Default for RasterState {
    /// Power-on state of a fresh context.
    fn default() -> Self {
        Self {
            depth_test: false,
            depth_write: true,
            depth_func: DepthFunc::Less,
            cull_back_faces: false,
        }
    }
}

pub(super) struct DeviceState {
    pub(super) width: u32,
    pub(super) height: u32,
    pub(super) back: Vec<Rgba8>,
    pub(super) front: Vec<Rgba8>,
    pub(super) depth: Vec<u16>,
    pub(super) raster: RasterState,

    next_handle: u64,
    pub(super) interfaces: HashSet<u64>,
    pub(super) devices: HashSet<u64>,
    pub(super) dcs: HashSet<u64>,
    pub(super) contexts: HashSet<u64>,
    pub(super) current: Option<u64>,

    pub(super) in_scene: bool,
    pub(super) presented: u64,

    pub(super) gl_errors: VecDeque<GlError>,
    pub(super) gl_clear_color: Rgba8,
    pub(super) gl_clear_depth: f64,

    faults: HashMap<FaultPoint, Fault>,
    calls: Vec<DeviceCall>,
}

impl DeviceState {
    fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            back: vec![Rgba8::default(); len],
            front: vec![Rgba8::default(); len],
            depth: vec![0; len],
            raster: RasterState::default(),
            next_handle: 0x1000,
            interfaces: HashSet::new(),
            devices: HashSet::new(),
            dcs: HashSet::new(),
            contexts: HashSet::new(),
            current: None,
            in_scene: false,
            presented: 0,
            gl_errors: VecDeque::new(),
            gl_clear_color: Rgba8::default(),
            gl_clear_depth: 1.0,
            faults: HashMap::new(),
            calls: Vec::new(),
        }
    }

    pub(super) fn record(&mut self, call: DeviceCall) {
        log::trace!("software device: {call:?}");
        self.calls.push(call);
    }

    pub(super) fn fault(&self, point: FaultPoint) -> Option<Fault> {
        self.faults.get(&point).copied()
    }

    pub(super) fn alloc_handle(&mut self) -> NonZeroU64 {
        self.next_handle += 0x10;
        NonZeroU64::new(self.next_handle).unwrap_or(NonZeroU64::MIN)
    }

    pub(super) fn fill_color(&mut self, color: Rgba8) {
        self.back.fill(color);
    }

    pub(super) fn fill_depth(&mut self, depth: f32) {
        let q = quantize_depth(depth);
        self.depth.fill(q);
    }

    pub(super) fn swap(&mut self) {
        self.front.copy_from_slice(&self.back);
        self.presented += 1;
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height).then(|| (y * self.width + x) as usize)
    }
}

/// 16-bit depth quantization, matching the configured depth buffer.
fn quantize_depth(depth: f32) -> u16 {
    (depth.clamp(0.0, 1.0) * u16::MAX as f32).round() as u16
}

fn dequantize_depth(q: u16) -> f32 {
    q as f32 / u16::MAX as f32
}

/// CPU framebuffer shared by the software drivers.
///
/// Cloning yields another handle to the same device, so a test can keep one
/// handle while the backend owns a driver built from another. Single thread
/// only.
///
/// The device has a 32-bit RGBA back buffer, a front buffer that receives the
/// back buffer on present, and a 16-bit depth buffer. Every native call is
/// appended to a journal, and any call site can be made to fail with
/// [`SoftwareDevice::inject`].
#[derive(Clone)]
pub struct SoftwareDevice {
    inner: Rc<RefCell<DeviceState>>,
}

impl SoftwareDevice {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            inner: Rc::new(RefCell::new(DeviceState::new(width, height))),
        }
    }

    pub(super) fn state(&self) -> Ref<'_, DeviceState> {
        self.inner.borrow()
    }

    pub(super) fn state_mut(&self) -> RefMut<'_, DeviceState> {
        self.inner.borrow_mut()
    }

    pub fn size(&self) -> (u32, u32) {
        let s = self.state();
        (s.width, s.height)
    }

    /// Makes every subsequent call at `point` fail with `fault` until cleared.
    pub fn inject(&self, point: FaultPoint, fault: Fault) {
        self.state_mut().faults.insert(point, fault);
    }

    pub fn clear_fault(&self, point: FaultPoint) {
        self.state_mut().faults.remove(&point);
    }

    pub fn clear_faults(&self) {
        self.state_mut().faults.clear();
    }

    /// Snapshot of the journal.
    pub fn calls(&self) -> Vec<DeviceCall> {
        self.state().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state_mut().calls.clear();
    }

    /// Appends an external entry to the journal.
    pub fn note(&self, what: impl Into<String>) {
        self.state_mut().record(DeviceCall::Note(what.into()));
    }

    /// Interfaces, devices, device contexts and rendering contexts still alive.
    pub fn live_objects(&self) -> usize {
        let s = self.state();
        s.interfaces.len() + s.devices.len() + s.dcs.len() + s.contexts.len()
    }

    pub fn has_current_context(&self) -> bool {
        self.state().current.is_some()
    }

    pub fn raster_state(&self) -> RasterState {
        self.state().raster
    }

    pub fn in_scene(&self) -> bool {
        self.state().in_scene
    }

    pub fn presented_frames(&self) -> u64 {
        self.state().presented
    }

    pub fn back_pixel(&self, x: u32, y: u32) -> Option<Rgba8> {
        let s = self.state();
        s.index(x, y).map(|i| s.back[i])
    }

    pub fn front_pixel(&self, x: u32, y: u32) -> Option<Rgba8> {
        let s = self.state();
        s.index(x, y).map(|i| s.front[i])
    }

    pub fn depth_at(&self, x: u32, y: u32) -> Option<f32> {
        let s = self.state();
        s.index(x, y).map(|i| dequantize_depth(s.depth[i]))
    }

    /// Back buffer as tightly packed RGBA bytes, row-major.
    pub fn back_buffer_bytes(&self) -> Vec<u8> {
        bytemuck::cast_slice(&self.state().back).to_vec()
    }

    /// Rasterizes an axis-aligned quad at constant `depth` into the back buffer.
    ///
    /// Honors the depth test, comparison function and depth-write mask.
    /// Returns the number of pixels written.
    pub fn draw_quad(&self, x: u32, y: u32, w: u32, h: u32, color: Rgba8, depth: f32) -> usize {
        let mut s = self.state_mut();
        let raster = s.raster;
        let incoming = dequantize_depth(quantize_depth(depth));
        let q = quantize_depth(depth);

        let x1 = x.saturating_add(w).min(s.width);
        let y1 = y.saturating_add(h).min(s.height);

        let mut written = 0;
        for py in y.min(y1)..y1 {
            for px in x.min(x1)..x1 {
                let i = (py * s.width + px) as usize;
                let stored = dequantize_depth(s.depth[i]);
                if raster.depth_test && !raster.depth_func.passes(incoming, stored) {
                    continue;
                }
                s.back[i] = color;
                if raster.depth_write {
                    s.depth[i] = q;
                }
                written += 1;
            }
        }
        written
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_round_trips_far_plane_exactly() {
        assert_eq!(dequantize_depth(quantize_depth(1.0)), 1.0);
        assert_eq!(dequantize_depth(quantize_depth(0.0)), 0.0);
    }

    #[test]
    fn clones_share_state() {
        let a = SoftwareDevice::new(2, 2);
        let b = a.clone();
        b.note("hello");
        assert_eq!(a.calls(), vec![DeviceCall::Note("hello".into())]);
    }

    #[test]
    fn draw_quad_honors_less_equal_depth_test() {
        let dev = SoftwareDevice::new(4, 4);
        {
            let mut s = dev.state_mut();
            s.fill_depth(0.5);
            s.raster = RasterState {
                depth_test: true,
                depth_write: true,
                depth_func: DepthFunc::LessEqual,
                cull_back_faces: false,
            };
        }
        let red = Rgba8::new(255, 0, 0, 255);
        assert_eq!(dev.draw_quad(0, 0, 2, 2, red, 0.75), 0);
        assert_eq!(dev.draw_quad(0, 0, 2, 2, red, 0.5), 4);
        assert_eq!(dev.back_pixel(1, 1), Some(red));
        assert_eq!(dev.back_pixel(2, 2), Some(Rgba8::default()));
    }

    #[test]
    fn draw_quad_clips_to_surface() {
        let dev = SoftwareDevice::new(4, 4);
        assert_eq!(dev.draw_quad(3, 3, 10, 10, Rgba8::new(1, 2, 3, 4), 0.0), 1);
    }

    #[test]
    fn back_buffer_bytes_are_rgba() {
        let dev = SoftwareDevice::new(1, 1);
        dev.state_mut().fill_color(Rgba8::new(1, 2, 3, 4));
        assert_eq!(dev.back_buffer_bytes(), vec![1, 2, 3, 4]);
    }
}
