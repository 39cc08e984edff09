use crate::backend::{
    stale_context, BackendKind, Context, Core, DeviceConfig, DeviceFault, FrameError, FrameStage,
    InitError, InitStage, LifecycleState, RenderStateConfig, Rollback, ShutdownError, WindowHandle,
};
use crate::paint::Color;

use super::api::{
    ClearMask, DcHandle, GlCapability, GlError, GlrcHandle, PixelFormatDescriptor, WglApi,
};

/// OpenGL backend over WGL.
///
/// The [`Context`] it hands out wraps the window's device context, which is
/// what `SwapBuffers` needs. The rendering context stays current on the
/// calling thread between `initialize` and `shutdown`.
pub struct OpenGlCore<A: WglApi> {
    api: A,
    device_config: DeviceConfig,
    render_state: RenderStateConfig,

    window: Option<WindowHandle>,
    dc: Option<DcHandle>,
    glrc: Option<GlrcHandle>,
}

impl<A: WglApi> OpenGlCore<A> {
    pub fn new(api: A, device_config: DeviceConfig, render_state: RenderStateConfig) -> Self {
        Self {
            api,
            device_config,
            render_state,
            window: None,
            dc: None,
            glrc: None,
        }
    }

    pub fn with_defaults(api: A) -> Self {
        Self::new(api, DeviceConfig::default(), RenderStateConfig::default())
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn api_mut(&mut self) -> &mut A {
        &mut self.api
    }

    pub fn window(&self) -> Option<WindowHandle> {
        self.window
    }

    fn live_dc(&self, stage: FrameStage, context: Context) -> Result<DcHandle, FrameError> {
        match (self.dc, self.glrc) {
            (Some(dc), Some(_)) if dc.raw() == context.raw() => Ok(dc),
            (Some(_), Some(_)) => Err(stale_context(stage, context)),
            _ => Err(FrameError::NotReady(LifecycleState::Uninitialized)),
        }
    }
}

impl<A: WglApi> Core for OpenGlCore<A> {
    fn kind(&self) -> BackendKind {
        BackendKind::OpenGl
    }

    fn initialize(&mut self, window: WindowHandle) -> Result<Context, InitError> {
        let kind = BackendKind::OpenGl;
        let mut rollback = Rollback::new(&mut self.api);

        let dc = rollback.api().get_dc(window).ok_or_else(|| {
            InitError::new(kind, InitStage::Surface, "Windows failed to get the device context")
        })?;
        rollback.push("device context", move |api: &mut A| {
            if api.release_dc(window, dc) {
                Ok(())
            } else {
                Err("Windows failed to release the device context".to_string())
            }
        });

        let descriptor = PixelFormatDescriptor::from_config(&self.device_config);
        let chosen = rollback.api().choose_pixel_format(dc, &descriptor).map_err(|e| {
            InitError::new(
                kind,
                InitStage::Surface,
                format!("Windows couldn't choose the closest pixel format: {e}"),
            )
        });
        let format = rollback.guard(chosen)?;

        let set = rollback
            .api()
            .set_pixel_format(dc, format, &descriptor)
            .map_err(|e| {
                InitError::new(
                    kind,
                    InitStage::Surface,
                    format!("Windows couldn't set the desired pixel format: {e}"),
                )
            });
        rollback.guard(set)?;

        let created = rollback.api().create_context(dc).map_err(|e| {
            InitError::new(
                kind,
                InitStage::Device,
                format!("Windows failed to create an OpenGL rendering context: {e}"),
            )
        });
        let glrc = rollback.guard(created)?;
        rollback.push("OpenGL rendering context", move |api: &mut A| {
            release_context(api, dc, glrc)
        });

        let current = rollback.api().make_current(dc, Some(glrc)).map_err(|e| {
            InitError::new(
                kind,
                InitStage::Device,
                format!("Windows failed to set the current OpenGL rendering context: {e}"),
            )
        });
        rollback.guard(current)?;

        let loaded = rollback
            .api()
            .load_extensions()
            .map_err(|message| InitError::new(kind, InitStage::Extensions, message));
        rollback.guard(loaded)?;

        if self.render_state.cull_back_faces {
            let culled = enable_culling(rollback.api());
            rollback.guard(culled)?;
        }

        let applied = apply_render_state(rollback.api(), &self.render_state);
        rollback.guard(applied)?;

        rollback.commit();
        self.window = Some(window);
        self.dc = Some(dc);
        self.glrc = Some(glrc);

        log::debug!("OpenGL context ready for window {}", window.raw());
        Ok(Context::from_raw(dc.raw()))
    }

    fn clear(&mut self, color: Color, depth: f32, context: Context) -> Result<(), FrameError> {
        self.live_dc(FrameStage::Clear, context)?;

        let mut first_error = GlError::NoError;
        let mut note = |api: &mut A| {
            let e = api.get_error();
            if e.is_error() && !first_error.is_error() {
                first_error = e;
            }
        };

        self.api.clear_color(
            color.r.clamp(0.0, 1.0),
            color.g.clamp(0.0, 1.0),
            color.b.clamp(0.0, 1.0),
            color.a.clamp(0.0, 1.0),
        );
        note(&mut self.api);
        self.api.clear_depth(depth.clamp(0.0, 1.0) as f64);
        note(&mut self.api);
        // glClear leaves the depth buffer untouched while depth writes are masked.
        self.api.depth_mask(true);
        note(&mut self.api);
        self.api.clear(ClearMask::COLOR | ClearMask::DEPTH);
        note(&mut self.api);

        if !self.render_state.depth_write {
            self.api.depth_mask(false);
            note(&mut self.api);
        }

        if first_error.is_error() {
            Err(FrameError::device(
                FrameStage::Clear,
                first_error.fault(),
                format!("OpenGL failed to clear the frame: {first_error}"),
            ))
        } else {
            Ok(())
        }
    }

    fn begin_frame(&mut self, context: Context) -> Result<(), FrameError> {
        // OpenGL has no scene bracketing.
        self.live_dc(FrameStage::BeginFrame, context).map(|_| ())
    }

    fn end_frame(&mut self, context: Context) -> Result<(), FrameError> {
        self.live_dc(FrameStage::EndFrame, context).map(|_| ())
    }

    fn present(&mut self, context: Context) -> Result<(), FrameError> {
        let dc = self.live_dc(FrameStage::Present, context)?;
        self.api.swap_buffers(dc).map_err(|e| {
            FrameError::device(
                FrameStage::Present,
                e.fault(),
                format!("Windows failed to swap buffers: {e}"),
            )
        })?;

        match self.api.get_error() {
            GlError::ContextLost => Err(FrameError::device(
                FrameStage::Present,
                DeviceFault::Lost,
                "OpenGL context lost",
            )),
            _ => Ok(()),
        }
    }

    fn shutdown(&mut self) -> Result<(), ShutdownError> {
        let mut failures = Vec::new();

        if let Some(glrc) = self.glrc.take() {
            match self.dc {
                Some(dc) => {
                    if let Err(e) = release_context(&mut self.api, dc, glrc) {
                        failures.push(e);
                    }
                }
                None => failures.push("OpenGL rendering context without a device context".into()),
            }
        }

        if let Some(dc) = self.dc.take() {
            let released = match self.window {
                Some(window) => self.api.release_dc(window, dc),
                None => false,
            };
            if !released {
                failures.push("Windows failed to release the device context".to_string());
            }
        }

        self.window = None;

        for failure in &failures {
            log::warn!("{failure}");
        }
        ShutdownError::check(failures)
    }
}

/// Unbinds and deletes a rendering context. Deletion is skipped if unbinding fails.
fn release_context<A: WglApi>(api: &mut A, dc: DcHandle, glrc: GlrcHandle) -> Result<(), String> {
    api.make_current(dc, None).map_err(|e| {
        format!("Windows failed to unset the current OpenGL rendering context: {e}")
    })?;
    api.delete_context(glrc)
        .map_err(|e| format!("Windows failed to delete the OpenGL rendering context: {e}"))
}

fn enable_culling<A: WglApi>(api: &mut A) -> Result<(), InitError> {
    api.enable(GlCapability::CullFace);
    match api.get_error() {
        GlError::NoError => Ok(()),
        e => Err(InitError::new(
            BackendKind::OpenGl,
            InitStage::RenderState,
            format!("OpenGL failed to enable culling: {}", e.description()),
        )),
    }
}

fn apply_render_state<A: WglApi>(api: &mut A, config: &RenderStateConfig) -> Result<(), InitError> {
    let mut failed = false;
    let mut poll = |api: &mut A, what: &str| {
        let e = api.get_error();
        if e.is_error() {
            log::debug!("{what} raised {e}");
            failed = true;
        }
    };

    if config.depth_test {
        api.enable(GlCapability::DepthTest);
    } else {
        api.disable(GlCapability::DepthTest);
    }
    poll(&mut *api, "glEnable(GL_DEPTH_TEST)");
    api.depth_mask(config.depth_write);
    poll(&mut *api, "glDepthMask");
    api.depth_func(config.depth_func);
    poll(&mut *api, "glDepthFunc");

    if failed {
        Err(InitError::new(
            BackendKind::OpenGl,
            InitStage::RenderState,
            "OpenGL failed to set render state",
        ))
    } else {
        Ok(())
    }
}
