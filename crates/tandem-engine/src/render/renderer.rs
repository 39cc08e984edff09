use crate::backend::{
    BackendKind, Context, Core, FrameError, InitError, InitStage, LifecycleEvent, LifecycleState,
    RendererConfig, ShutdownError, WindowHandle,
};
use crate::paint::Color;

use super::binder::{bind_and_draw, ResourceBinder};
use super::diagnostics::DiagnosticSink;
use super::frame::FrameReport;
use super::source::RenderableSource;

/// Drives one backend through its lifecycle and renders frames with it.
///
/// The renderer owns the backend and the single live [`Context`]. All calls
/// take `&mut self`, so the frame protocol can never interleave.
pub struct Renderer {
    backend: Box<dyn Core>,
    config: RendererConfig,

    state: LifecycleState,
    context: Context,
    window: Option<WindowHandle>,
    frame_index: u64,
}

impl Renderer {
    pub fn new(backend: Box<dyn Core>, config: RendererConfig) -> Self {
        Self {
            backend,
            config,
            state: LifecycleState::Uninitialized,
            context: Context::NULL,
            window: None,
            frame_index: 0,
        }
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Live context, or [`Context::NULL`] while not ready.
    pub fn context(&self) -> Context {
        self.context
    }

    pub fn window(&self) -> Option<WindowHandle> {
        self.window
    }

    /// Index the next rendered frame will get.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn set_clear_color(&mut self, color: Color) {
        self.config.clear_color = color;
    }

    fn transition(&mut self, event: LifecycleEvent) {
        match self.state.next(event) {
            Some(next) => self.state = next,
            None => log::warn!("ignoring {event:?} while {}", self.state),
        }
    }

    /// Brings the backend up on `window`.
    ///
    /// On failure the backend has already rolled back, the renderer stays
    /// uninitialized and the error message is reported to `sink` once,
    /// followed by one message per resource the rollback failed to release.
    pub fn initialize<D>(&mut self, window: WindowHandle, sink: &mut D) -> Result<Context, InitError>
    where
        D: DiagnosticSink + ?Sized,
    {
        let kind = self.backend.kind();
        if self.state != LifecycleState::Uninitialized {
            let err = InitError::new(
                kind,
                InitStage::AlreadyInitialized,
                format!("{kind} renderer is already {}", self.state),
            );
            sink.report(&err.message);
            return Err(err);
        }

        match self.backend.initialize(window) {
            Ok(context) => {
                self.transition(LifecycleEvent::Initialized);
                self.context = context;
                self.window = Some(window);
                log::info!("{kind} renderer ready ({context:?})");
                Ok(context)
            }
            Err(err) => {
                self.transition(LifecycleEvent::InitializeFailed);
                log::debug!("{kind} initialization failed at {:?}", err.stage);
                sink.report(&err.message);
                for failure in &err.rollback_failures {
                    sink.report(failure);
                }
                Err(err)
            }
        }
    }

    /// Renders one frame: clear, begin, bind and draw every renderable,
    /// discard the source, end, present.
    ///
    /// A clear or begin failure aborts the frame after discarding the source.
    /// An end failure skips present. A failing renderable is skipped and the
    /// loop moves on. Outside `Ready` nothing is touched and the report
    /// carries a single `NotReady` error.
    pub fn render<S, B, D>(&mut self, source: &mut S, binder: &mut B, sink: &mut D) -> FrameReport
    where
        S: RenderableSource + ?Sized,
        B: ResourceBinder + ?Sized,
        D: DiagnosticSink + ?Sized,
    {
        let mut report = FrameReport {
            frame_index: self.frame_index,
            submitted: source.len(),
            ..FrameReport::default()
        };

        if !self.state.is_ready() {
            fail(&mut report, sink, FrameError::NotReady(self.state));
            return report;
        }
        self.frame_index += 1;

        let context = self.context;
        log::trace!("frame {}: {} renderable(s)", report.frame_index, report.submitted);

        let opened = self
            .backend
            .clear(self.config.clear_color, self.config.clear_depth, context)
            .and_then(|()| self.backend.begin_frame(context));
        if let Err(err) = opened {
            source.discard_all();
            fail(&mut report, sink, err);
            return report;
        }

        for index in 0..report.submitted {
            let Some(renderable) = source.entry_at(index) else {
                fail(&mut report, sink, FrameError::MissingRenderable { index });
                continue;
            };
            match bind_and_draw(binder, &renderable, context) {
                Ok(()) => report.drawn += 1,
                Err((step, err)) => {
                    let detail = format!("{err:#}");
                    fail(&mut report, sink, FrameError::Renderable { index, step, detail });
                }
            }
        }
        source.discard_all();

        if let Err(err) = self.backend.end_frame(context) {
            fail(&mut report, sink, err);
            return report;
        }

        match self.backend.present(context) {
            Ok(()) => report.presented = true,
            Err(err) => fail(&mut report, sink, err),
        }
        report
    }

    /// Discards the source and releases the backend.
    ///
    /// A no-op returning `Ok` when already uninitialized. Release failures
    /// do not stop later releases; each is reported once and returned.
    pub fn shutdown<S, D>(&mut self, source: &mut S, sink: &mut D) -> Result<(), ShutdownError>
    where
        S: RenderableSource + ?Sized,
        D: DiagnosticSink + ?Sized,
    {
        source.discard_all();
        if self.state == LifecycleState::Uninitialized {
            return Ok(());
        }

        self.transition(LifecycleEvent::ShutdownStarted);
        let result = self.backend.shutdown();
        self.context = Context::NULL;
        self.window = None;
        self.transition(LifecycleEvent::ShutdownFinished);

        match &result {
            Ok(()) => log::info!("{} renderer shut down", self.backend.kind()),
            Err(err) => {
                for failure in &err.failures {
                    sink.report(failure);
                }
            }
        }
        result
    }

    /// Shuts down and initializes again on the same window, e.g. after the
    /// device was lost.
    pub fn recreate<S, D>(&mut self, source: &mut S, sink: &mut D) -> Result<Context, InitError>
    where
        S: RenderableSource + ?Sized,
        D: DiagnosticSink + ?Sized,
    {
        let Some(window) = self.window else {
            let err = InitError::new(
                self.backend.kind(),
                InitStage::Surface,
                "no window to recreate the device for",
            );
            sink.report(&err.message);
            return Err(err);
        };

        log::info!("recreating {} device", self.backend.kind());
        // Failures were already reported; the device is gone either way.
        let _ = self.shutdown(source, sink);
        self.initialize(window, sink)
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        if self.state == LifecycleState::Uninitialized {
            return;
        }
        log::debug!("renderer dropped while {}; releasing backend", self.state);
        if let Err(err) = self.backend.shutdown() {
            log::warn!("{err}");
        }
    }
}

fn fail<D>(report: &mut FrameReport, sink: &mut D, err: FrameError)
where
    D: DiagnosticSink + ?Sized,
{
    sink.report(&err.to_string());
    report.errors.push(err);
}

#[cfg(test)]
mod tests {
    use anyhow::{bail, Result};

    use super::*;
    use crate::backend::software::{self, DeviceCall, Fault, FaultPoint, SoftwareDevice};
    use crate::backend::{BindStep, DeviceFault, FrameStage, RecoveryAction};
    use crate::paint::Rgba8;
    use crate::render::{
        EffectHandle, MaterialHandle, MeshHandle, MessageLog, RenderQueue, Renderable,
    };

    const RED: Rgba8 = Rgba8::new(255, 0, 0, 255);
    const BLACK: Rgba8 = Rgba8::new(0, 0, 0, 255);

    /// Notes every step in the device journal and draws mesh `n` as the
    /// pixel at `(n, 0)`. Fails texture binding for one material.
    struct JournalBinder {
        device: SoftwareDevice,
        fail_textures_of: Option<u32>,
    }

    impl JournalBinder {
        fn new(device: &SoftwareDevice) -> Self {
            Self {
                device: device.clone(),
                fail_textures_of: None,
            }
        }
    }

    impl ResourceBinder for JournalBinder {
        fn bind_effect(&mut self, effect: EffectHandle, _: Context) -> Result<()> {
            self.device.note(format!("effect {}", effect.0));
            Ok(())
        }

        fn set_material_uniforms(&mut self, material: MaterialHandle, _: Context) -> Result<()> {
            self.device.note(format!("material uniforms {}", material.id));
            Ok(())
        }

        fn set_material_textures(&mut self, material: MaterialHandle, _: Context) -> Result<()> {
            self.device.note(format!("textures {}", material.id));
            if self.fail_textures_of == Some(material.id) {
                bail!("texture for material {} not loaded", material.id);
            }
            Ok(())
        }

        fn set_draw_call_uniforms(&mut self, effect: EffectHandle, _: Context) -> Result<()> {
            self.device.note(format!("draw-call uniforms {}", effect.0));
            Ok(())
        }

        fn draw_mesh(&mut self, mesh: MeshHandle, _: Context) -> Result<()> {
            self.device.note(format!("mesh {}", mesh.0));
            self.device.draw_quad(mesh.0, 0, 1, 1, RED, 0.5);
            Ok(())
        }
    }

    fn window() -> WindowHandle {
        WindowHandle::new(42).unwrap()
    }

    fn renderer(kind: BackendKind) -> (SoftwareDevice, Renderer) {
        let device = SoftwareDevice::new(4, 2);
        let config = RendererConfig::default();
        let backend = software::create_core(kind, device.clone(), &config);
        (device, Renderer::new(backend, config))
    }

    fn queue(ids: &[u32]) -> RenderQueue {
        let mut q = RenderQueue::new();
        for &id in ids {
            q.submit(Renderable::new(MeshHandle(id), MaterialHandle::new(id, EffectHandle(7))));
        }
        q
    }

    fn position(calls: &[DeviceCall], wanted: &DeviceCall) -> usize {
        calls.iter().position(|c| c == wanted).unwrap()
    }

    fn note(text: &str) -> DeviceCall {
        DeviceCall::Note(text.to_string())
    }

    #[test]
    fn empty_frame_then_shutdown_restores_initial_state() {
        for kind in BackendKind::ALL {
            let (device, mut r) = renderer(kind);
            let mut sink = MessageLog::new();
            let mut q = RenderQueue::new();

            let ctx = r.initialize(window(), &mut sink).unwrap();
            assert_eq!(r.state(), LifecycleState::Ready);
            assert_eq!(r.context(), ctx);

            let report = r.render(&mut q, &mut JournalBinder::new(&device), &mut sink);
            assert!(report.is_clean(), "{kind}: {:?}", report.errors);
            assert!(report.presented);
            assert_eq!(report.drawn, 0);
            assert_eq!(device.presented_frames(), 1);
            assert_eq!(device.calls().iter().filter(|c| **c == DeviceCall::Clear).count(), 1);

            r.shutdown(&mut q, &mut sink).unwrap();
            assert_eq!(r.state(), LifecycleState::Uninitialized);
            assert!(r.context().is_null());
            assert_eq!(r.window(), None);
            assert_eq!(device.live_objects(), 0);
            assert!(sink.is_empty());
        }
    }

    #[test]
    fn failed_device_creation_reports_once_and_blocks_rendering() {
        let (device, mut r) = renderer(BackendKind::Direct3D9);
        device.inject(FaultPoint::CreateDevice, Fault::Failed);
        let mut sink = MessageLog::new();

        let err = r.initialize(window(), &mut sink).unwrap_err();
        assert_eq!(err.stage, InitStage::Device);
        assert_eq!(sink.messages(), ["Direct3D failed to create a Direct3D9 device"]);
        assert_eq!(r.state(), LifecycleState::Uninitialized);
        assert!(r.context().is_null());
        assert_eq!(device.live_objects(), 0);

        let before = device.calls().len();
        let mut q = queue(&[1]);
        let report = r.render(&mut q, &mut JournalBinder::new(&device), &mut sink);
        assert_eq!(
            report.errors,
            [FrameError::NotReady(LifecycleState::Uninitialized)]
        );
        assert_eq!(device.calls().len(), before);
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn failed_context_creation_reports_once_and_blocks_rendering() {
        let (device, mut r) = renderer(BackendKind::OpenGl);
        device.inject(FaultPoint::CreateContext, Fault::Failed);
        let mut sink = MessageLog::new();

        let err = r.initialize(window(), &mut sink).unwrap_err();
        assert_eq!(err.stage, InitStage::Device);
        assert!(err.rolled_back_cleanly());
        assert_eq!(sink.len(), 1);
        assert_eq!(r.state(), LifecycleState::Uninitialized);
        assert_eq!(device.live_objects(), 0);

        device.clear_calls();
        let mut q = queue(&[1]);
        let report = r.render(&mut q, &mut JournalBinder::new(&device), &mut sink);
        assert_eq!(
            report.errors,
            [FrameError::NotReady(LifecycleState::Uninitialized)]
        );
        assert!(device.calls().is_empty());
    }

    #[test]
    fn dirty_rollback_reports_each_release_failure() {
        let (device, mut r) = renderer(BackendKind::Direct3D9);
        device.inject(FaultPoint::CreateDevice, Fault::Failed);
        device.inject(FaultPoint::ReleaseInterface, Fault::Failed);
        let mut sink = MessageLog::new();

        let err = r.initialize(window(), &mut sink).unwrap_err();
        assert_eq!(err.rollback_failures.len(), 1);
        assert!(err.rollback_failures[0].starts_with("Direct3D9 interface"));
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.messages()[0], err.message);
        assert_eq!(sink.messages()[1], err.rollback_failures[0]);

        device.clear_fault(FaultPoint::CreateDevice);
        device.clear_fault(FaultPoint::ReleaseInterface);
        r.initialize(window(), &mut sink).unwrap();
        assert_eq!(r.state(), LifecycleState::Ready);
    }

    #[test]
    fn failing_texture_skips_only_that_renderable() {
        for kind in BackendKind::ALL {
            let (device, mut r) = renderer(kind);
            let mut sink = MessageLog::new();
            r.initialize(window(), &mut sink).unwrap();

            let mut binder = JournalBinder::new(&device);
            binder.fail_textures_of = Some(2);
            let mut q = queue(&[1, 2, 3]);

            let report = r.render(&mut q, &mut binder, &mut sink);
            assert_eq!(report.submitted, 3);
            assert_eq!(report.drawn, 2);
            assert!(report.presented);
            assert_eq!(report.action(), RecoveryAction::Continue);
            assert_eq!(
                report.errors,
                [FrameError::Renderable {
                    index: 1,
                    step: BindStep::MaterialTextures,
                    detail: "texture for material 2 not loaded".into(),
                }]
            );
            assert_eq!(
                sink.messages(),
                ["renderable 1: set material textures failed: texture for material 2 not loaded"]
            );
            assert!(q.is_empty());

            let calls = device.calls();
            assert!(calls.contains(&note("mesh 1")));
            assert!(calls.contains(&note("mesh 3")));
            assert!(calls.contains(&note("textures 2")));
            assert!(!calls.contains(&note("mesh 2")));

            assert_eq!(device.front_pixel(1, 0), Some(RED));
            assert_eq!(device.front_pixel(2, 0), Some(BLACK));
            assert_eq!(device.front_pixel(3, 0), Some(RED));
        }
    }

    #[test]
    fn frame_calls_are_ordered() {
        let (device, mut r) = renderer(BackendKind::Direct3D9);
        let mut sink = MessageLog::new();
        r.initialize(window(), &mut sink).unwrap();

        let mut q = queue(&[1, 2]);
        r.render(&mut q, &mut JournalBinder::new(&device), &mut sink);

        let calls = device.calls();
        let clear = position(&calls, &DeviceCall::Clear);
        let begin = position(&calls, &DeviceCall::BeginScene);
        let first_bind = position(&calls, &note("effect 7"));
        let last_draw = position(&calls, &note("mesh 2"));
        let end = position(&calls, &DeviceCall::EndScene);
        let present = position(&calls, &DeviceCall::Present);

        assert!(clear < begin);
        assert!(begin < first_bind);
        assert!(position(&calls, &note("mesh 1")) < position(&calls, &note("textures 2")));
        assert!(last_draw < end);
        assert!(end < present);
    }

    #[test]
    fn clear_writes_configured_color_and_depth() {
        for kind in BackendKind::ALL {
            let (device, mut r) = renderer(kind);
            let mut sink = MessageLog::new();
            r.initialize(window(), &mut sink).unwrap();
            let mut q = RenderQueue::new();

            r.render(&mut q, &mut JournalBinder::new(&device), &mut sink);
            for (x, y) in [(0, 0), (3, 1)] {
                assert_eq!(device.back_pixel(x, y), Some(BLACK), "{kind}");
                assert_eq!(device.depth_at(x, y), Some(1.0), "{kind}");
            }
        }
    }

    #[test]
    fn initialize_twice_is_rejected_without_device_calls() {
        let (device, mut r) = renderer(BackendKind::OpenGl);
        let mut sink = MessageLog::new();
        let ctx = r.initialize(window(), &mut sink).unwrap();
        let before = device.calls().len();

        let err = r.initialize(window(), &mut sink).unwrap_err();
        assert_eq!(err.stage, InitStage::AlreadyInitialized);
        assert_eq!(device.calls().len(), before);
        assert_eq!(sink.len(), 1);
        assert_eq!(r.context(), ctx);
        assert_eq!(r.state(), LifecycleState::Ready);
    }

    #[test]
    fn clear_failure_aborts_frame_but_discards_source() {
        for kind in BackendKind::ALL {
            let (device, mut r) = renderer(kind);
            let mut sink = MessageLog::new();
            r.initialize(window(), &mut sink).unwrap();
            device.inject(FaultPoint::Clear, Fault::Failed);

            let mut q = queue(&[1, 2]);
            let report = r.render(&mut q, &mut JournalBinder::new(&device), &mut sink);

            assert!(!report.presented);
            assert_eq!(report.drawn, 0);
            assert_eq!(report.errors.len(), 1);
            assert!(matches!(
                report.errors[0],
                FrameError::Device { stage: FrameStage::Clear, fault: DeviceFault::Failed, .. }
            ));
            assert_eq!(report.action(), RecoveryAction::SkipFrame);
            assert!(q.is_empty());
            assert_eq!(sink.len(), 1);

            let calls = device.calls();
            assert!(!calls.contains(&DeviceCall::BeginScene));
            assert!(!calls.contains(&DeviceCall::Present));
            assert!(!calls.contains(&note("effect 7")));
        }
    }

    #[test]
    fn end_failure_skips_present() {
        let (device, mut r) = renderer(BackendKind::Direct3D9);
        let mut sink = MessageLog::new();
        r.initialize(window(), &mut sink).unwrap();
        device.inject(FaultPoint::EndScene, Fault::Failed);

        let mut q = queue(&[1]);
        let report = r.render(&mut q, &mut JournalBinder::new(&device), &mut sink);
        assert_eq!(report.drawn, 1);
        assert!(!report.presented);
        assert!(q.is_empty());
        assert!(!device.calls().contains(&DeviceCall::Present));
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn lost_device_is_recreated() {
        for kind in BackendKind::ALL {
            let (device, mut r) = renderer(kind);
            let mut sink = MessageLog::new();
            let mut q = RenderQueue::new();
            let mut binder = JournalBinder::new(&device);
            let first = r.initialize(window(), &mut sink).unwrap();

            device.inject(FaultPoint::Present, Fault::Lost);
            let report = r.render(&mut q, &mut binder, &mut sink);
            assert_eq!(report.action(), RecoveryAction::RecreateDevice, "{kind}");

            device.clear_faults();
            let second = r.recreate(&mut q, &mut sink).unwrap();
            assert_ne!(first, second);
            assert_eq!(r.state(), LifecycleState::Ready);
            assert_eq!(r.window(), Some(window()));

            let report = r.render(&mut q, &mut binder, &mut sink);
            assert!(report.presented);
            assert_eq!(report.frame_index, 1);
            assert_eq!(sink.len(), 1);
        }
    }

    #[test]
    fn shutdown_failures_are_reported_once_each() {
        let (device, mut r) = renderer(BackendKind::Direct3D9);
        let mut sink = MessageLog::new();
        let mut q = RenderQueue::new();
        r.initialize(window(), &mut sink).unwrap();
        device.inject(FaultPoint::ReleaseInterface, Fault::Failed);

        let err = r.shutdown(&mut q, &mut sink).unwrap_err();
        assert_eq!(err.failures.len(), 1);
        assert_eq!(sink.messages(), err.failures.as_slice());
        assert_eq!(r.state(), LifecycleState::Uninitialized);
        assert!(r.context().is_null());

        assert!(r.shutdown(&mut q, &mut sink).is_ok());
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn missing_entry_is_reported_and_skipped() {
        struct Holey(RenderQueue);

        impl RenderableSource for Holey {
            fn len(&self) -> usize {
                self.0.len() + 1
            }
            fn entry_at(&self, index: usize) -> Option<Renderable> {
                self.0.entry_at(index)
            }
            fn discard_all(&mut self) {
                self.0.discard_all();
            }
        }

        let (device, mut r) = renderer(BackendKind::OpenGl);
        let mut sink = MessageLog::new();
        r.initialize(window(), &mut sink).unwrap();

        let mut source = Holey(queue(&[1]));
        let report = r.render(&mut source, &mut JournalBinder::new(&device), &mut sink);
        assert_eq!(report.drawn, 1);
        assert_eq!(report.errors, [FrameError::MissingRenderable { index: 1 }]);
        assert!(report.presented);
        assert!(source.0.is_empty());
    }

    #[test]
    fn dropping_a_ready_renderer_releases_the_device() {
        let (device, mut r) = renderer(BackendKind::OpenGl);
        r.initialize(window(), &mut MessageLog::new()).unwrap();
        assert!(device.live_objects() > 0);
        drop(r);
        assert_eq!(device.live_objects(), 0);
        assert!(!device.has_current_context());
    }
}
