use crate::backend::{
    stale_context, BackendKind, Context, Core, DeviceConfig, FrameError, FrameStage, InitError,
    InitStage, LifecycleState, RenderStateConfig, Rollback, ShutdownError, WindowHandle,
};
use crate::paint::Color;

use super::api::{
    ClearFlags, D3d9Api, D3dRenderState, DeviceCreation, DeviceHandle, HResult, InterfaceHandle,
    PresentParameters,
};

/// Direct3D9 backend.
///
/// Owns the API interface and the device; the [`Context`] it hands out wraps
/// the device handle.
pub struct Direct3D9Core<A: D3d9Api> {
    api: A,
    device_config: DeviceConfig,
    render_state: RenderStateConfig,

    window: Option<WindowHandle>,
    interface: Option<InterfaceHandle>,
    device: Option<DeviceHandle>,
}

impl<A: D3d9Api> Direct3D9Core<A> {
    pub fn new(api: A, device_config: DeviceConfig, render_state: RenderStateConfig) -> Self {
        Self {
            api,
            device_config,
            render_state,
            window: None,
            interface: None,
            device: None,
        }
    }

    /// Backend with the default device and render-state configuration.
    pub fn with_defaults(api: A) -> Self {
        Self::new(api, DeviceConfig::default(), RenderStateConfig::default())
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn api_mut(&mut self) -> &mut A {
        &mut self.api
    }

    /// Window the device presents to, while initialized.
    pub fn window(&self) -> Option<WindowHandle> {
        self.window
    }

    fn live_device(&self, stage: FrameStage, context: Context) -> Result<DeviceHandle, FrameError> {
        match self.device {
            Some(device) if device.raw() == context.raw() => Ok(device),
            Some(_) => Err(stale_context(stage, context)),
            None => Err(FrameError::NotReady(LifecycleState::Uninitialized)),
        }
    }
}

impl<A: D3d9Api> Core for Direct3D9Core<A> {
    fn kind(&self) -> BackendKind {
        BackendKind::Direct3D9
    }

    fn initialize(&mut self, window: WindowHandle) -> Result<Context, InitError> {
        let kind = BackendKind::Direct3D9;
        let mut rollback = Rollback::new(&mut self.api);

        let interface = rollback.api().create_interface().ok_or_else(|| {
            InitError::new(
                kind,
                InitStage::Surface,
                "DirectX failed to create a Direct3D9 interface",
            )
        })?;
        rollback.push("Direct3D9 interface", move |api: &mut A| {
            expect_released(api.release_interface(interface), "Direct3D9 interface")
        });

        let params = PresentParameters::from_config(window, &self.device_config);
        let creation = DeviceCreation::from_config(&self.device_config);
        let created = rollback
            .api()
            .create_device(interface, &creation, &params)
            .map_err(|hr| {
                log::debug!("CreateDevice returned {hr}");
                InitError::new(
                    kind,
                    InitStage::Device,
                    "Direct3D failed to create a Direct3D9 device",
                )
            });
        let device = rollback.guard(created)?;
        rollback.push("Direct3D9 device", move |api: &mut A| {
            expect_released(api.release_device(device), "Direct3D9 device")
        });

        let applied = apply_render_state(rollback.api(), device, &self.render_state);
        rollback.guard(applied)?;

        rollback.commit();
        self.window = Some(window);
        self.interface = Some(interface);
        self.device = Some(device);

        log::debug!("Direct3D9 device ready for window {}", window.raw());
        Ok(Context::from_raw(device.raw()))
    }

    fn clear(&mut self, color: Color, depth: f32, context: Context) -> Result<(), FrameError> {
        let device = self.live_device(FrameStage::Clear, context)?;
        let argb = color.to_rgba8().to_argb();
        let no_stencil = 0;
        let hr = self.api.clear(
            device,
            ClearFlags::TARGET | ClearFlags::ZBUFFER,
            argb,
            depth.clamp(0.0, 1.0),
            no_stencil,
        );
        check(FrameStage::Clear, hr)
    }

    fn begin_frame(&mut self, context: Context) -> Result<(), FrameError> {
        let device = self.live_device(FrameStage::BeginFrame, context)?;
        check(FrameStage::BeginFrame, self.api.begin_scene(device))
    }

    fn end_frame(&mut self, context: Context) -> Result<(), FrameError> {
        let device = self.live_device(FrameStage::EndFrame, context)?;
        check(FrameStage::EndFrame, self.api.end_scene(device))
    }

    fn present(&mut self, context: Context) -> Result<(), FrameError> {
        let device = self.live_device(FrameStage::Present, context)?;
        check(FrameStage::Present, self.api.present(device))
    }

    fn shutdown(&mut self) -> Result<(), ShutdownError> {
        let mut failures = Vec::new();

        if let Some(device) = self.device.take() {
            let hr = self.api.set_vertex_declaration(device, None);
            if hr.failed() {
                failures.push(format!(
                    "Direct3D failed to detach the vertex declaration: {hr}"
                ));
            }
            if let Err(e) = expect_released(self.api.release_device(device), "Direct3D9 device") {
                failures.push(e);
            }
        }

        if let Some(interface) = self.interface.take() {
            if let Err(e) =
                expect_released(self.api.release_interface(interface), "Direct3D9 interface")
            {
                failures.push(e);
            }
        }

        self.window = None;

        for failure in &failures {
            log::warn!("{failure}");
        }
        ShutdownError::check(failures)
    }
}

fn check(stage: FrameStage, hr: HResult) -> Result<(), FrameError> {
    if hr.succeeded() {
        Ok(())
    } else {
        Err(FrameError::device(stage, hr.fault(), hr.to_string()))
    }
}

fn expect_released(remaining: u32, what: &str) -> Result<(), String> {
    if remaining == 0 {
        Ok(())
    } else {
        Err(format!("{what} still holds {remaining} reference(s) after release"))
    }
}

/// Applies every state even after a failure so the log shows all of them.
fn apply_render_state<A: D3d9Api>(
    api: &mut A,
    device: DeviceHandle,
    config: &RenderStateConfig,
) -> Result<(), InitError> {
    let states = [
        D3dRenderState::ZEnable(config.depth_test),
        D3dRenderState::ZWriteEnable(config.depth_write),
        D3dRenderState::ZFunc(config.depth_func),
    ];

    let mut failed = false;
    for state in states {
        let hr = api.set_render_state(device, state);
        if hr.failed() {
            log::debug!("SetRenderState({state:?}) returned {hr}");
            failed = true;
        }
    }

    if failed {
        Err(InitError::new(
            BackendKind::Direct3D9,
            InitStage::RenderState,
            "Direct3D failed to set render state",
        ))
    } else {
        Ok(())
    }
}
