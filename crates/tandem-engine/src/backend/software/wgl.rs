use std::num::NonZeroU32;

use crate::backend::opengl::{
    ClearMask, DcHandle, GlCapability, GlError, GlrcHandle, PixelFormatDescriptor, PixelFormatId,
    PixelType, WglApi, WinError,
};
use crate::backend::{DepthFunc, WindowHandle};
use crate::paint::{unorm_to_u8, Rgba8};

use super::device::{DeviceCall, Fault, FaultPoint, RasterState, SoftwareDevice};

/// WGL/OpenGL-shaped driver over a [`SoftwareDevice`].
pub struct SoftwareWgl {
    device: SoftwareDevice,
}

impl SoftwareWgl {
    pub fn new(device: SoftwareDevice) -> Self {
        Self { device }
    }

    pub fn device(&self) -> &SoftwareDevice {
        &self.device
    }

    /// GL calls without a current context raise `GL_INVALID_OPERATION`.
    fn require_current(&self) -> bool {
        let mut s = self.device.state_mut();
        if s.current.is_none() {
            s.gl_errors.push_back(GlError::InvalidOperation);
            return false;
        }
        true
    }
}

fn win_error(fault: Fault) -> WinError {
    WinError::new(match fault {
        Fault::Failed => WinError::INVALID_HANDLE,
        Fault::Lost => WinError::DEVICE_NOT_CONNECTED,
        Fault::OutOfMemory => WinError::NOT_ENOUGH_MEMORY,
    })
}

fn gl_error(fault: Fault) -> GlError {
    match fault {
        Fault::Failed => GlError::InvalidOperation,
        Fault::Lost => GlError::ContextLost,
        Fault::OutOfMemory => GlError::OutOfMemory,
    }
}

impl WglApi for SoftwareWgl {
    fn get_dc(&mut self, _window: WindowHandle) -> Option<DcHandle> {
        let mut s = self.device.state_mut();
        s.record(DeviceCall::GetDc);
        if s.fault(FaultPoint::GetDc).is_some() {
            return None;
        }
        let id = s.alloc_handle();
        s.dcs.insert(id.get());
        Some(DcHandle::new(id))
    }

    fn release_dc(&mut self, _window: WindowHandle, dc: DcHandle) -> bool {
        let mut s = self.device.state_mut();
        s.record(DeviceCall::ReleaseDc);
        if s.fault(FaultPoint::ReleaseDc).is_some() {
            return false;
        }
        s.dcs.remove(&dc.raw())
    }

    fn choose_pixel_format(
        &mut self,
        dc: DcHandle,
        descriptor: &PixelFormatDescriptor,
    ) -> Result<PixelFormatId, WinError> {
        let mut s = self.device.state_mut();
        s.record(DeviceCall::ChoosePixelFormat);
        if !s.dcs.contains(&dc.raw()) {
            return Err(WinError::new(WinError::INVALID_HANDLE));
        }
        if let Some(fault) = s.fault(FaultPoint::ChoosePixelFormat) {
            return Err(win_error(fault));
        }
        if !descriptor.support_opengl || descriptor.pixel_type != PixelType::Rgba {
            return Err(WinError::new(WinError::INVALID_PIXEL_FORMAT));
        }
        Ok(PixelFormatId(NonZeroU32::MIN))
    }

    fn set_pixel_format(
        &mut self,
        dc: DcHandle,
        _format: PixelFormatId,
        _descriptor: &PixelFormatDescriptor,
    ) -> Result<(), WinError> {
        let mut s = self.device.state_mut();
        s.record(DeviceCall::SetPixelFormat);
        if !s.dcs.contains(&dc.raw()) {
            return Err(WinError::new(WinError::INVALID_HANDLE));
        }
        match s.fault(FaultPoint::SetPixelFormat) {
            Some(fault) => Err(win_error(fault)),
            None => Ok(()),
        }
    }

    fn create_context(&mut self, dc: DcHandle) -> Result<GlrcHandle, WinError> {
        let mut s = self.device.state_mut();
        s.record(DeviceCall::CreateContext);
        if !s.dcs.contains(&dc.raw()) {
            return Err(WinError::new(WinError::INVALID_HANDLE));
        }
        if let Some(fault) = s.fault(FaultPoint::CreateContext) {
            return Err(win_error(fault));
        }
        let id = s.alloc_handle();
        s.contexts.insert(id.get());
        s.raster = RasterState::default();
        s.gl_errors.clear();
        Ok(GlrcHandle::new(id))
    }

    fn make_current(&mut self, dc: DcHandle, context: Option<GlrcHandle>) -> Result<(), WinError> {
        let mut s = self.device.state_mut();
        s.record(DeviceCall::MakeCurrent {
            bind: context.is_some(),
        });
        if let Some(fault) = s.fault(FaultPoint::MakeCurrent) {
            return Err(win_error(fault));
        }
        match context {
            Some(glrc) => {
                if !s.dcs.contains(&dc.raw()) || !s.contexts.contains(&glrc.raw()) {
                    return Err(WinError::new(WinError::INVALID_HANDLE));
                }
                s.current = Some(glrc.raw());
            }
            None => s.current = None,
        }
        Ok(())
    }

    fn delete_context(&mut self, context: GlrcHandle) -> Result<(), WinError> {
        let mut s = self.device.state_mut();
        s.record(DeviceCall::DeleteContext);
        if let Some(fault) = s.fault(FaultPoint::DeleteContext) {
            return Err(win_error(fault));
        }
        if !s.contexts.remove(&context.raw()) {
            return Err(WinError::new(WinError::INVALID_HANDLE));
        }
        if s.current == Some(context.raw()) {
            s.current = None;
        }
        Ok(())
    }

    fn load_extensions(&mut self) -> Result<(), String> {
        let mut s = self.device.state_mut();
        s.record(DeviceCall::LoadExtensions);
        if s.fault(FaultPoint::LoadExtensions).is_some() {
            return Err("OpenGL extension function glCreateProgram could not be loaded".into());
        }
        Ok(())
    }

    fn swap_buffers(&mut self, dc: DcHandle) -> Result<(), WinError> {
        let mut s = self.device.state_mut();
        s.record(DeviceCall::Present);
        if !s.dcs.contains(&dc.raw()) {
            return Err(WinError::new(WinError::INVALID_HANDLE));
        }
        if let Some(fault) = s.fault(FaultPoint::Present) {
            return Err(win_error(fault));
        }
        s.swap();
        Ok(())
    }

    fn enable(&mut self, capability: GlCapability) {
        self.device.state_mut().record(DeviceCall::Enable(capability));
        if !self.require_current() {
            return;
        }
        let mut s = self.device.state_mut();
        let point = match capability {
            GlCapability::DepthTest => FaultPoint::SetRenderState,
            GlCapability::CullFace => FaultPoint::EnableCullFace,
        };
        if let Some(fault) = s.fault(point) {
            s.gl_errors.push_back(gl_error(fault));
            return;
        }
        match capability {
            GlCapability::DepthTest => s.raster.depth_test = true,
            GlCapability::CullFace => s.raster.cull_back_faces = true,
        }
    }

    fn disable(&mut self, capability: GlCapability) {
        self.device.state_mut().record(DeviceCall::Disable(capability));
        if !self.require_current() {
            return;
        }
        let mut s = self.device.state_mut();
        match capability {
            GlCapability::DepthTest => s.raster.depth_test = false,
            GlCapability::CullFace => s.raster.cull_back_faces = false,
        }
    }

    fn depth_mask(&mut self, write: bool) {
        self.device.state_mut().record(DeviceCall::DepthMask(write));
        if self.require_current() {
            self.device.state_mut().raster.depth_write = write;
        }
    }

    fn depth_func(&mut self, func: DepthFunc) {
        self.device.state_mut().record(DeviceCall::DepthFunc(func));
        if self.require_current() {
            self.device.state_mut().raster.depth_func = func;
        }
    }

    fn clear_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.device.state_mut().record(DeviceCall::ClearColor);
        if self.require_current() {
            self.device.state_mut().gl_clear_color =
                Rgba8::new(unorm_to_u8(r), unorm_to_u8(g), unorm_to_u8(b), unorm_to_u8(a));
        }
    }

    fn clear_depth(&mut self, depth: f64) {
        self.device.state_mut().record(DeviceCall::ClearDepth);
        if self.require_current() {
            self.device.state_mut().gl_clear_depth = depth.clamp(0.0, 1.0);
        }
    }

    fn clear(&mut self, mask: ClearMask) {
        self.device.state_mut().record(DeviceCall::Clear);
        if !self.require_current() {
            return;
        }
        let mut s = self.device.state_mut();
        if let Some(fault) = s.fault(FaultPoint::Clear) {
            s.gl_errors.push_back(gl_error(fault));
            return;
        }
        if mask.contains(ClearMask::COLOR) {
            let color = s.gl_clear_color;
            s.fill_color(color);
        }
        if mask.contains(ClearMask::DEPTH) && s.raster.depth_write {
            let depth = s.gl_clear_depth as f32;
            s.fill_depth(depth);
        }
    }

    fn get_error(&mut self) -> GlError {
        self.device
            .state_mut()
            .gl_errors
            .pop_front()
            .unwrap_or(GlError::NoError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gl_calls_without_current_context_queue_errors() {
        let dev = SoftwareDevice::new(1, 1);
        let mut api = SoftwareWgl::new(dev);
        api.depth_mask(false);
        assert_eq!(api.get_error(), GlError::InvalidOperation);
        assert_eq!(api.get_error(), GlError::NoError);
    }

    #[test]
    fn masked_depth_is_not_cleared() {
        let dev = SoftwareDevice::new(1, 1);
        let mut api = SoftwareWgl::new(dev.clone());
        let window = WindowHandle::new(1).unwrap();
        let dc = api.get_dc(window).unwrap();
        let glrc = api.create_context(dc).unwrap();
        api.make_current(dc, Some(glrc)).unwrap();

        api.clear_depth(1.0);
        api.depth_mask(false);
        api.clear(ClearMask::DEPTH);
        assert_eq!(dev.depth_at(0, 0), Some(0.0));

        api.depth_mask(true);
        api.clear(ClearMask::DEPTH);
        assert_eq!(dev.depth_at(0, 0), Some(1.0));
    }

    #[test]
    fn deleting_current_context_unbinds_it() {
        let dev = SoftwareDevice::new(1, 1);
        let mut api = SoftwareWgl::new(dev.clone());
        let dc = api.get_dc(WindowHandle::new(1).unwrap()).unwrap();
        let glrc = api.create_context(dc).unwrap();
        api.make_current(dc, Some(glrc)).unwrap();
        api.delete_context(glrc).unwrap();
        assert!(!dev.has_current_context());
    }
}
