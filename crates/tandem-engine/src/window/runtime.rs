use std::sync::Arc;

use anyhow::{Context, Result};

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::backend::{gpu, BackendKind, RecoveryAction, RendererConfig, WindowHandle};
use crate::core::{App as CoreApp, AppControl, FrameCtx, WindowCtx};
use crate::render::{LogSink, RenderQueue, Renderer};

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    pub backend: BackendKind,
    pub renderer: RendererConfig,

    /// Exit after this many rendered frames. `None` runs until the window
    /// is closed.
    pub max_frames: Option<u64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "tandem".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
            backend: BackendKind::Direct3D9,
            renderer: RendererConfig::default(),
            max_frames: None,
        }
    }
}

impl RuntimeConfig {
    fn frame_budget_spent(&self, rendered: u64) -> bool {
        self.max_frames.is_some_and(|max| rendered >= max)
    }
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    pub fn run<A>(config: RuntimeConfig, app: A) -> Result<()>
    where
        A: 'static + CoreApp,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, app);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        if let Some(e) = state.failure.take() {
            return Err(e);
        }
        Ok(())
    }
}

struct WindowEntry {
    window: Arc<Window>,
    renderer: Renderer,
    queue: RenderQueue,
}

impl WindowEntry {
    fn shutdown(&mut self) {
        // Release failures were already reported through the sink.
        let _ = self.renderer.shutdown(&mut self.queue, &mut LogSink);
    }
}

struct AppState<A>
where
    A: CoreApp + 'static,
{
    config: RuntimeConfig,
    app: A,

    entry: Option<WindowEntry>,
    frames_rendered: u64,
    exit_requested: bool,
    failure: Option<anyhow::Error>,
}

impl<A> AppState<A>
where
    A: CoreApp + 'static,
{
    fn new(config: RuntimeConfig, app: A) -> Self {
        Self {
            config,
            app,
            entry: None,
            frames_rendered: 0,
            exit_requested: false,
            failure: None,
        }
    }

    fn request_exit(&mut self, event_loop: &ActiveEventLoop) {
        self.exit_requested = true;
        if let Some(mut entry) = self.entry.take() {
            entry.shutdown();
        }
        event_loop.exit();
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{error:#}");
        self.failure.get_or_insert(error);
        self.request_exit(event_loop);
    }

    fn create_window_entry(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("failed to create window")?,
        );

        let backend = gpu::create_core(self.config.backend, window.clone(), &self.config.renderer);
        let mut renderer = Renderer::new(backend, self.config.renderer.clone());
        renderer
            .initialize(WindowHandle::from(window.id()), &mut LogSink)
            .with_context(|| format!("{} renderer initialization failed", self.config.backend))?;

        window.request_redraw();
        self.entry = Some(WindowEntry {
            window,
            renderer,
            queue: RenderQueue::new(),
        });
        Ok(())
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId) {
        let Self { app, entry, .. } = self;
        let Some(entry) = entry.as_mut() else {
            return;
        };

        let mut control = {
            let mut ctx = FrameCtx {
                window: WindowCtx {
                    id: window_id,
                    window: &entry.window,
                },
                backend: entry.renderer.backend_kind(),
                frame_index: entry.renderer.frame_index(),
                queue: &mut entry.queue,
            };
            app.on_frame(&mut ctx)
        };

        entry.window.pre_present_notify();
        let report = entry
            .renderer
            .render(&mut entry.queue, app.binder(), &mut LogSink);
        log::trace!(
            "frame {}: drew {}/{} renderable(s), presented: {}",
            report.frame_index,
            report.drawn,
            report.submitted,
            report.presented
        );

        if app.on_frame_rendered(&report) == AppControl::Exit {
            control = AppControl::Exit;
        }

        if report.action() == RecoveryAction::RecreateDevice {
            let recreated = entry.renderer.recreate(&mut entry.queue, &mut LogSink);
            if let Err(e) = recreated {
                self.fail(event_loop, anyhow::Error::new(e).context("device recreation failed"));
                return;
            }
        }

        self.frames_rendered += 1;
        if control == AppControl::Exit || self.config.frame_budget_spent(self.frames_rendered) {
            log::info!("exiting after {} frame(s)", self.frames_rendered);
            self.request_exit(event_loop);
        }
    }
}

impl<A> ApplicationHandler for AppState<A>
where
    A: CoreApp + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.entry.is_some() || self.exit_requested {
            return;
        }

        if let Err(e) = self.create_window_entry(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        // Continuous redraw.
        event_loop.set_control_flow(ControlFlow::Wait);
        if let Some(entry) = &self.entry {
            entry.window.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        if self.app.on_window_event(window_id, &event) == AppControl::Exit {
            self.request_exit(event_loop);
            return;
        }

        match &event {
            WindowEvent::CloseRequested => self.request_exit(event_loop),

            // The GPU drivers pick up the new size on the next frame.
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(entry) = &self.entry {
                    entry.window.request_redraw();
                }
            }

            WindowEvent::RedrawRequested => self.redraw(event_loop, window_id),

            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(mut entry) = self.entry.take() {
            entry.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded_by_default() {
        let c = RuntimeConfig::default();
        assert_eq!(c.max_frames, None);
        assert!(!c.frame_budget_spent(u64::MAX));
    }

    #[test]
    fn frame_budget() {
        let c = RuntimeConfig {
            max_frames: Some(3),
            ..Default::default()
        };
        assert!(!c.frame_budget_spent(2));
        assert!(c.frame_budget_spent(3));
    }
}
