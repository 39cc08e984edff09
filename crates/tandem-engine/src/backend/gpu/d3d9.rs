use std::num::NonZeroU64;
use std::sync::Arc;

use winit::window::Window;

use crate::backend::d3d9::{
    ClearFlags, D3d9Api, D3dRenderState, DeviceCreation, DeviceHandle, DeviceType, HResult,
    InterfaceHandle, PresentParameters,
};
use crate::backend::DeviceFault;
use crate::paint::Rgba8;

use super::device::{self, WgpuDevice};
use super::GpuInit;

fn hresult(fault: DeviceFault) -> HResult {
    match fault {
        DeviceFault::Lost => HResult::D3DERR_DEVICELOST,
        DeviceFault::OutOfMemory => HResult::D3DERR_OUTOFVIDEOMEMORY,
        DeviceFault::Failed => HResult::E_FAIL,
    }
}

/// Direct3D9-shaped driver on wgpu.
///
/// The interface object is a `wgpu::Instance`; the device owns the window
/// surface, adapter and logical device. One of each at a time.
pub struct WgpuD3d9 {
    window: Arc<Window>,
    init: GpuInit,
    next_handle: u64,

    instance: Option<(InterfaceHandle, wgpu::Instance)>,
    device: Option<(DeviceHandle, WgpuDevice)>,
    in_scene: bool,
}

impl WgpuD3d9 {
    pub fn new(window: Arc<Window>, init: GpuInit) -> Self {
        Self {
            window,
            init,
            next_handle: 0,
            instance: None,
            device: None,
            in_scene: false,
        }
    }

    /// The live device, if created.
    pub fn device(&self) -> Option<&WgpuDevice> {
        self.device.as_ref().map(|(_, d)| d)
    }

    fn alloc(&mut self) -> NonZeroU64 {
        self.next_handle += 1;
        NonZeroU64::new(self.next_handle).unwrap_or(NonZeroU64::MIN)
    }

    fn live(&mut self, handle: DeviceHandle) -> Option<&mut WgpuDevice> {
        match self.device.as_mut() {
            Some((h, d)) if *h == handle => Some(d),
            _ => None,
        }
    }
}

impl D3d9Api for WgpuD3d9 {
    fn create_interface(&mut self) -> Option<InterfaceHandle> {
        if self.instance.is_some() {
            log::warn!("Direct3D9 interface already created");
            return None;
        }
        let handle = InterfaceHandle::new(self.alloc());
        self.instance = Some((handle, device::create_instance(&self.init)));
        Some(handle)
    }

    fn create_device(
        &mut self,
        interface: InterfaceHandle,
        creation: &DeviceCreation,
        params: &PresentParameters,
    ) -> Result<DeviceHandle, HResult> {
        let Some((_, instance)) = self.instance.as_ref().filter(|(h, _)| *h == interface) else {
            return Err(HResult::D3DERR_INVALIDCALL);
        };
        if self.device.is_some() || !params.windowed {
            return Err(HResult::D3DERR_INVALIDCALL);
        }

        let mut init = self.init.clone();
        init.force_fallback_adapter |= creation.device_type == DeviceType::Reference;

        let created = device::create_surface(instance, Arc::clone(&self.window)).and_then(|surface| {
            let adapter = device::request_adapter(instance, &surface, &init)?;
            WgpuDevice::new(Arc::clone(&self.window), surface, adapter, &init)
        });

        match created {
            Ok(dev) => {
                let handle = DeviceHandle::new(self.alloc());
                self.device = Some((handle, dev));
                self.in_scene = false;
                Ok(handle)
            }
            Err(e) => {
                log::warn!("wgpu device creation failed: {e:#}");
                Err(HResult::D3DERR_NOTAVAILABLE)
            }
        }
    }

    fn set_render_state(&mut self, device: DeviceHandle, state: D3dRenderState) -> HResult {
        let Some(dev) = self.live(device) else {
            return HResult::D3DERR_INVALIDCALL;
        };
        let mut depth = dev.depth_state();
        match state {
            D3dRenderState::ZEnable(on) => depth.test = on,
            D3dRenderState::ZWriteEnable(on) => depth.write = on,
            D3dRenderState::ZFunc(func) => depth.func = func,
        }
        dev.set_depth_state(depth);
        HResult::OK
    }

    fn clear(
        &mut self,
        device: DeviceHandle,
        flags: ClearFlags,
        color: u32,
        z: f32,
        _stencil: u32,
    ) -> HResult {
        let Some(dev) = self.live(device) else {
            return HResult::D3DERR_INVALIDCALL;
        };
        if !flags.contains(ClearFlags::TARGET) {
            log::debug!("depth-only clear is not supported by the wgpu driver");
            return HResult::D3DERR_INVALIDCALL;
        }
        let depth = flags.contains(ClearFlags::ZBUFFER).then_some(z);
        match dev.clear(Rgba8::from_argb(color).to_color().to_wgpu(), depth) {
            Ok(()) => HResult::OK,
            Err(fault) => hresult(fault),
        }
    }

    fn begin_scene(&mut self, device: DeviceHandle) -> HResult {
        if self.in_scene {
            return HResult::D3DERR_INVALIDCALL;
        }
        let Some(dev) = self.live(device) else {
            return HResult::D3DERR_INVALIDCALL;
        };
        if let Err(fault) = dev.acquire() {
            return hresult(fault);
        }
        self.in_scene = true;
        HResult::OK
    }

    fn end_scene(&mut self, device: DeviceHandle) -> HResult {
        if !self.in_scene {
            return HResult::D3DERR_INVALIDCALL;
        }
        let Some(dev) = self.live(device) else {
            return HResult::D3DERR_INVALIDCALL;
        };
        dev.submit();
        self.in_scene = false;
        HResult::OK
    }

    fn present(&mut self, device: DeviceHandle) -> HResult {
        if self.in_scene {
            return HResult::D3DERR_INVALIDCALL;
        }
        let Some(dev) = self.live(device) else {
            return HResult::D3DERR_INVALIDCALL;
        };
        match dev.present() {
            Ok(()) => HResult::OK,
            Err(fault) => hresult(fault),
        }
    }

    fn set_vertex_declaration(&mut self, device: DeviceHandle, _declaration: Option<u64>) -> HResult {
        // Vertex layouts live in wgpu pipelines; nothing is bound on the device.
        match self.live(device) {
            Some(_) => HResult::OK,
            None => HResult::D3DERR_INVALIDCALL,
        }
    }

    fn release_device(&mut self, device: DeviceHandle) -> u32 {
        if self.live(device).is_some() {
            self.device = None;
            self.in_scene = false;
        }
        0
    }

    fn release_interface(&mut self, interface: InterfaceHandle) -> u32 {
        if matches!(self.instance, Some((h, _)) if h == interface) {
            if self.device.is_some() {
                // The device keeps its own reference to the instance internals.
                return 1;
            }
            self.instance = None;
        }
        0
    }
}
