use crate::backend::d3d9::{
    ClearFlags, D3d9Api, D3dRenderState, DeviceCreation, DeviceHandle, HResult, InterfaceHandle,
    PresentParameters,
};
use crate::paint::Rgba8;

use super::device::{DeviceCall, Fault, FaultPoint, RasterState, SoftwareDevice};

/// Direct3D9-shaped driver over a [`SoftwareDevice`].
pub struct SoftwareD3d9 {
    device: SoftwareDevice,
}

impl SoftwareD3d9 {
    pub fn new(device: SoftwareDevice) -> Self {
        Self { device }
    }

    pub fn device(&self) -> &SoftwareDevice {
        &self.device
    }
}

fn hresult(fault: Fault) -> HResult {
    match fault {
        Fault::Failed => HResult::E_FAIL,
        Fault::Lost => HResult::D3DERR_DEVICELOST,
        Fault::OutOfMemory => HResult::D3DERR_OUTOFVIDEOMEMORY,
    }
}

impl SoftwareD3d9 {
    /// Records `call`, then validates the device and the fault table.
    fn enter(&self, call: DeviceCall, device: DeviceHandle, point: FaultPoint) -> HResult {
        let mut s = self.device.state_mut();
        s.record(call);
        if !s.devices.contains(&device.raw()) {
            return HResult::D3DERR_INVALIDCALL;
        }
        match s.fault(point) {
            Some(fault) => hresult(fault),
            None => HResult::OK,
        }
    }
}

impl D3d9Api for SoftwareD3d9 {
    fn create_interface(&mut self) -> Option<InterfaceHandle> {
        let mut s = self.device.state_mut();
        s.record(DeviceCall::CreateInterface);
        if s.fault(FaultPoint::CreateInterface).is_some() {
            return None;
        }
        let id = s.alloc_handle();
        s.interfaces.insert(id.get());
        Some(InterfaceHandle::new(id))
    }

    fn create_device(
        &mut self,
        interface: InterfaceHandle,
        _creation: &DeviceCreation,
        params: &PresentParameters,
    ) -> Result<DeviceHandle, HResult> {
        let mut s = self.device.state_mut();
        s.record(DeviceCall::CreateDevice);
        if !s.interfaces.contains(&interface.raw()) || !params.windowed {
            return Err(HResult::D3DERR_INVALIDCALL);
        }
        if let Some(fault) = s.fault(FaultPoint::CreateDevice) {
            return Err(hresult(fault));
        }
        let id = s.alloc_handle();
        s.devices.insert(id.get());
        s.raster = RasterState::default();
        s.in_scene = false;
        Ok(DeviceHandle::new(id))
    }

    fn set_render_state(&mut self, device: DeviceHandle, state: D3dRenderState) -> HResult {
        let hr = self.enter(DeviceCall::SetRenderState, device, FaultPoint::SetRenderState);
        if hr.succeeded() {
            let mut s = self.device.state_mut();
            match state {
                D3dRenderState::ZEnable(on) => s.raster.depth_test = on,
                D3dRenderState::ZWriteEnable(on) => s.raster.depth_write = on,
                D3dRenderState::ZFunc(func) => s.raster.depth_func = func,
            }
        }
        hr
    }

    fn clear(
        &mut self,
        device: DeviceHandle,
        flags: ClearFlags,
        color: u32,
        z: f32,
        _stencil: u32,
    ) -> HResult {
        let hr = self.enter(DeviceCall::Clear, device, FaultPoint::Clear);
        if hr.succeeded() {
            let mut s = self.device.state_mut();
            if flags.contains(ClearFlags::TARGET) {
                s.fill_color(Rgba8::from_argb(color));
            }
            if flags.contains(ClearFlags::ZBUFFER) {
                s.fill_depth(z);
            }
        }
        hr
    }

    fn begin_scene(&mut self, device: DeviceHandle) -> HResult {
        let hr = self.enter(DeviceCall::BeginScene, device, FaultPoint::BeginScene);
        if hr.failed() {
            return hr;
        }
        let mut s = self.device.state_mut();
        if s.in_scene {
            return HResult::D3DERR_INVALIDCALL;
        }
        s.in_scene = true;
        hr
    }

    fn end_scene(&mut self, device: DeviceHandle) -> HResult {
        let hr = self.enter(DeviceCall::EndScene, device, FaultPoint::EndScene);
        if hr.failed() {
            return hr;
        }
        let mut s = self.device.state_mut();
        if !s.in_scene {
            return HResult::D3DERR_INVALIDCALL;
        }
        s.in_scene = false;
        hr
    }

    fn present(&mut self, device: DeviceHandle) -> HResult {
        let hr = self.enter(DeviceCall::Present, device, FaultPoint::Present);
        if hr.failed() {
            return hr;
        }
        let mut s = self.device.state_mut();
        if s.in_scene {
            return HResult::D3DERR_INVALIDCALL;
        }
        s.swap();
        hr
    }

    fn set_vertex_declaration(
        &mut self,
        device: DeviceHandle,
        declaration: Option<u64>,
    ) -> HResult {
        self.enter(
            DeviceCall::SetVertexDeclaration(declaration),
            device,
            FaultPoint::SetVertexDeclaration,
        )
    }

    fn release_device(&mut self, device: DeviceHandle) -> u32 {
        let mut s = self.device.state_mut();
        s.record(DeviceCall::ReleaseDevice);
        if s.fault(FaultPoint::ReleaseDevice).is_some() {
            return 1;
        }
        s.devices.remove(&device.raw());
        s.in_scene = false;
        0
    }

    fn release_interface(&mut self, interface: InterfaceHandle) -> u32 {
        let mut s = self.device.state_mut();
        s.record(DeviceCall::ReleaseInterface);
        if s.fault(FaultPoint::ReleaseInterface).is_some() {
            return 1;
        }
        s.interfaces.remove(&interface.raw());
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DeviceConfig, WindowHandle};

    fn open(dev: &SoftwareDevice) -> (SoftwareD3d9, DeviceHandle) {
        let mut api = SoftwareD3d9::new(dev.clone());
        let itf = api.create_interface().unwrap();
        let config = DeviceConfig::default();
        let params = PresentParameters::from_config(WindowHandle::new(1).unwrap(), &config);
        let device = api
            .create_device(itf, &DeviceCreation::from_config(&config), &params)
            .unwrap();
        (api, device)
    }

    #[test]
    fn scene_bracketing_is_enforced() {
        let dev = SoftwareDevice::new(1, 1);
        let (mut api, device) = open(&dev);

        assert_eq!(api.end_scene(device), HResult::D3DERR_INVALIDCALL);
        assert!(api.begin_scene(device).succeeded());
        assert_eq!(api.begin_scene(device), HResult::D3DERR_INVALIDCALL);
        assert_eq!(api.present(device), HResult::D3DERR_INVALIDCALL);
        assert!(api.end_scene(device).succeeded());
        assert!(api.present(device).succeeded());
    }

    #[test]
    fn released_device_rejects_calls() {
        let dev = SoftwareDevice::new(1, 1);
        let (mut api, device) = open(&dev);
        assert_eq!(api.release_device(device), 0);
        assert_eq!(api.begin_scene(device), HResult::D3DERR_INVALIDCALL);
    }

    #[test]
    fn injected_fault_maps_to_hresult() {
        let dev = SoftwareDevice::new(1, 1);
        let (mut api, device) = open(&dev);
        dev.inject(FaultPoint::BeginScene, Fault::OutOfMemory);
        assert_eq!(api.begin_scene(device), HResult::D3DERR_OUTOFVIDEOMEMORY);
        assert!(!dev.in_scene());
    }
}
