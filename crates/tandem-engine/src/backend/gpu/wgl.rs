use std::collections::VecDeque;
use std::num::{NonZeroU32, NonZeroU64};
use std::sync::Arc;

use winit::window::Window;

use crate::backend::opengl::{
    ClearMask, DcHandle, GlCapability, GlError, GlrcHandle, PixelFormatDescriptor, PixelFormatId,
    PixelType, WglApi, WinError,
};
use crate::backend::{DepthFunc, DeviceFault, WindowHandle};

use super::device::{self, WgpuDevice};
use super::GpuInit;

/// Device context: the window surface plus the adapter picked for it.
struct DcSlot {
    handle: DcHandle,
    surface: Option<wgpu::Surface<'static>>,
    adapter: Option<wgpu::Adapter>,
}

/// WGL/OpenGL-shaped driver on wgpu.
///
/// `GetDC` creates the window surface, `ChoosePixelFormat` picks an adapter
/// that can present to it, and the rendering context is the logical device.
/// GL state calls are recorded on the device; failures queue GL errors.
pub struct WgpuWgl {
    window: Arc<Window>,
    init: GpuInit,
    instance: wgpu::Instance,
    next_handle: u64,

    dc: Option<DcSlot>,
    context: Option<(GlrcHandle, WgpuDevice)>,
    current: bool,

    clear_color: wgpu::Color,
    clear_depth: f32,
    errors: VecDeque<GlError>,
}

fn gl_error(fault: DeviceFault) -> GlError {
    match fault {
        DeviceFault::Lost => GlError::ContextLost,
        DeviceFault::OutOfMemory => GlError::OutOfMemory,
        DeviceFault::Failed => GlError::InvalidFramebufferOperation,
    }
}

fn win_error(fault: DeviceFault) -> WinError {
    WinError::new(match fault {
        DeviceFault::Lost => WinError::DEVICE_NOT_CONNECTED,
        DeviceFault::OutOfMemory => WinError::NOT_ENOUGH_MEMORY,
        DeviceFault::Failed => WinError::INVALID_HANDLE,
    })
}

impl WgpuWgl {
    pub fn new(window: Arc<Window>, init: GpuInit) -> Self {
        let instance = device::create_instance(&init);
        Self {
            window,
            init,
            instance,
            next_handle: 0,
            dc: None,
            context: None,
            current: false,
            clear_color: wgpu::Color::BLACK,
            clear_depth: 1.0,
            errors: VecDeque::new(),
        }
    }

    /// The rendering context's device, if created.
    pub fn device(&self) -> Option<&WgpuDevice> {
        self.context.as_ref().map(|(_, d)| d)
    }

    fn alloc(&mut self) -> NonZeroU64 {
        self.next_handle += 1;
        NonZeroU64::new(self.next_handle).unwrap_or(NonZeroU64::MIN)
    }

    fn slot(&mut self, dc: DcHandle) -> Result<&mut DcSlot, WinError> {
        match self.dc.as_mut() {
            Some(slot) if slot.handle == dc => Ok(slot),
            _ => Err(WinError::new(WinError::INVALID_HANDLE)),
        }
    }

    /// The current context's device; queues `GL_INVALID_OPERATION` when none is current.
    fn current_device(&mut self) -> Option<&mut WgpuDevice> {
        match self.context.as_mut() {
            Some((_, dev)) if self.current => Some(dev),
            _ => {
                self.errors.push_back(GlError::InvalidOperation);
                None
            }
        }
    }
}

impl WglApi for WgpuWgl {
    fn get_dc(&mut self, _window: WindowHandle) -> Option<DcHandle> {
        if self.dc.is_some() {
            log::warn!("device context already acquired");
            return None;
        }
        let surface = match device::create_surface(&self.instance, Arc::clone(&self.window)) {
            Ok(surface) => surface,
            Err(e) => {
                log::warn!("{e:#}");
                return None;
            }
        };
        let handle = DcHandle::new(self.alloc());
        self.dc = Some(DcSlot {
            handle,
            surface: Some(surface),
            adapter: None,
        });
        Some(handle)
    }

    fn release_dc(&mut self, _window: WindowHandle, dc: DcHandle) -> bool {
        if self.slot(dc).is_err() {
            return false;
        }
        self.dc = None;
        true
    }

    fn choose_pixel_format(
        &mut self,
        dc: DcHandle,
        descriptor: &PixelFormatDescriptor,
    ) -> Result<PixelFormatId, WinError> {
        if !descriptor.support_opengl || descriptor.pixel_type != PixelType::Rgba {
            return Err(WinError::new(WinError::INVALID_PIXEL_FORMAT));
        }

        let Some(slot) = self.dc.as_mut().filter(|slot| slot.handle == dc) else {
            return Err(WinError::new(WinError::INVALID_HANDLE));
        };
        let Some(surface) = slot.surface.as_ref() else {
            return Err(WinError::new(WinError::INVALID_HANDLE));
        };

        let adapter = device::request_adapter(&self.instance, surface, &self.init).map_err(|e| {
            log::warn!("{e:#}");
            WinError::new(WinError::NOT_SUPPORTED)
        })?;
        if surface.get_capabilities(&adapter).formats.is_empty() {
            return Err(WinError::new(WinError::INVALID_PIXEL_FORMAT));
        }
        slot.adapter = Some(adapter);
        Ok(PixelFormatId(NonZeroU32::MIN))
    }

    fn set_pixel_format(
        &mut self,
        dc: DcHandle,
        _format: PixelFormatId,
        _descriptor: &PixelFormatDescriptor,
    ) -> Result<(), WinError> {
        // The surface is configured when the device exists.
        match self.slot(dc)?.adapter {
            Some(_) => Ok(()),
            None => Err(WinError::new(WinError::INVALID_PIXEL_FORMAT)),
        }
    }

    fn create_context(&mut self, dc: DcHandle) -> Result<GlrcHandle, WinError> {
        if self.context.is_some() {
            return Err(WinError::new(WinError::NOT_SUPPORTED));
        }
        let slot = self.slot(dc)?;
        let (Some(surface), Some(adapter)) = (slot.surface.take(), slot.adapter.take()) else {
            return Err(WinError::new(WinError::INVALID_PIXEL_FORMAT));
        };

        let window = Arc::clone(&self.window);
        let dev = WgpuDevice::new(window, surface, adapter, &self.init).map_err(|e| {
            log::warn!("{e:#}");
            WinError::new(WinError::NOT_SUPPORTED)
        })?;
        let handle = GlrcHandle::new(self.alloc());
        self.context = Some((handle, dev));
        self.errors.clear();
        Ok(handle)
    }

    fn make_current(&mut self, dc: DcHandle, context: Option<GlrcHandle>) -> Result<(), WinError> {
        match context {
            Some(glrc) => {
                self.slot(dc)?;
                match &self.context {
                    Some((h, _)) if *h == glrc => {
                        self.current = true;
                        Ok(())
                    }
                    _ => Err(WinError::new(WinError::INVALID_HANDLE)),
                }
            }
            None => {
                self.current = false;
                Ok(())
            }
        }
    }

    fn delete_context(&mut self, context: GlrcHandle) -> Result<(), WinError> {
        match &self.context {
            Some((h, _)) if *h == context => {
                self.context = None;
                self.current = false;
                Ok(())
            }
            _ => Err(WinError::new(WinError::INVALID_HANDLE)),
        }
    }

    fn load_extensions(&mut self) -> Result<(), String> {
        let Some((_, dev)) = self.context.as_ref().filter(|_| self.current) else {
            return Err("no current OpenGL rendering context to load extensions for".into());
        };
        if dev.is_lost() {
            return Err("OpenGL context lost before extensions were loaded".into());
        }
        let caps = dev.downlevel_capabilities();
        if !caps.is_webgpu_compliant() {
            log::debug!(
                "downlevel GL adapter, missing {:?}",
                wgpu::DownlevelFlags::compliant().difference(caps.flags)
            );
        }
        Ok(())
    }

    fn swap_buffers(&mut self, dc: DcHandle) -> Result<(), WinError> {
        self.slot(dc)?;
        let Some((_, dev)) = self.context.as_mut() else {
            return Err(WinError::new(WinError::INVALID_HANDLE));
        };
        match dev.present() {
            Ok(()) => Ok(()),
            Err(DeviceFault::Lost) => {
                self.errors.push_back(GlError::ContextLost);
                Ok(())
            }
            Err(fault) => Err(win_error(fault)),
        }
    }

    fn enable(&mut self, capability: GlCapability) {
        if let Some(dev) = self.current_device() {
            match capability {
                GlCapability::DepthTest => {
                    let mut depth = dev.depth_state();
                    depth.test = true;
                    dev.set_depth_state(depth);
                }
                GlCapability::CullFace => dev.set_cull_back_faces(true),
            }
        }
    }

    fn disable(&mut self, capability: GlCapability) {
        if let Some(dev) = self.current_device() {
            match capability {
                GlCapability::DepthTest => {
                    let mut depth = dev.depth_state();
                    depth.test = false;
                    dev.set_depth_state(depth);
                }
                GlCapability::CullFace => dev.set_cull_back_faces(false),
            }
        }
    }

    fn depth_mask(&mut self, write: bool) {
        if let Some(dev) = self.current_device() {
            let mut depth = dev.depth_state();
            depth.write = write;
            dev.set_depth_state(depth);
        }
    }

    fn depth_func(&mut self, func: DepthFunc) {
        if let Some(dev) = self.current_device() {
            let mut depth = dev.depth_state();
            depth.func = func;
            dev.set_depth_state(depth);
        }
    }

    fn clear_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        if self.current_device().is_some() {
            self.clear_color = wgpu::Color {
                r: r.clamp(0.0, 1.0) as f64,
                g: g.clamp(0.0, 1.0) as f64,
                b: b.clamp(0.0, 1.0) as f64,
                a: a.clamp(0.0, 1.0) as f64,
            };
        }
    }

    fn clear_depth(&mut self, depth: f64) {
        if self.current_device().is_some() {
            self.clear_depth = depth.clamp(0.0, 1.0) as f32;
        }
    }

    fn clear(&mut self, mask: ClearMask) {
        let color = self.clear_color;
        let clear_depth = self.clear_depth;
        let Some(dev) = self.current_device() else {
            return;
        };
        if !mask.contains(ClearMask::COLOR) {
            self.errors.push_back(GlError::InvalidValue);
            return;
        }
        let depth = (mask.contains(ClearMask::DEPTH) && dev.depth_state().write).then_some(clear_depth);
        if let Err(fault) = dev.clear(color, depth) {
            self.errors.push_back(gl_error(fault));
        }
    }

    fn get_error(&mut self) -> GlError {
        if let Some((_, dev)) = &self.context {
            if dev.is_lost() && !self.errors.contains(&GlError::ContextLost) {
                self.errors.push_back(GlError::ContextLost);
            }
        }
        self.errors.pop_front().unwrap_or(GlError::NoError)
    }
}
