use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::backend::{DepthFunc, DeviceFault};

use super::surface;
use super::GpuInit;

/// Depth state applied to draws recorded on a [`WgpuDevice`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DepthState {
    pub test: bool,
    pub write: bool,
    pub func: DepthFunc,
}

impl Default for DepthState {
    /// Power-on state of a fresh device.
    fn default() -> Self {
        Self {
            test: false,
            write: true,
            func: DepthFunc::Less,
        }
    }
}

impl DepthState {
    /// Comparison a pipeline should use; `Always` while the test is off.
    pub fn compare(&self) -> wgpu::CompareFunction {
        if self.test {
            surface::compare_function(self.func)
        } else {
            wgpu::CompareFunction::Always
        }
    }
}

pub(crate) fn create_instance(init: &GpuInit) -> wgpu::Instance {
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: init.backends,
        ..Default::default()
    })
}

pub(crate) fn create_surface(
    instance: &wgpu::Instance,
    window: Arc<Window>,
) -> Result<wgpu::Surface<'static>> {
    instance
        .create_surface(window)
        .context("failed to create wgpu surface")
}

pub(crate) fn request_adapter(
    instance: &wgpu::Instance,
    surface: &wgpu::Surface<'_>,
    init: &GpuInit,
) -> Result<wgpu::Adapter> {
    pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        compatible_surface: Some(surface),
        force_fallback_adapter: init.force_fallback_adapter,
    }))
    .context("failed to find a suitable GPU adapter")
}

/// Represents a single acquired frame.
///
/// Holding the surface texture prevents acquisition of subsequent frames, so
/// the frame lives from the first clear or begin until present.
struct GpuFrame {
    surface_texture: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    /// Commands recorded since the last submit.
    encoder: Option<wgpu::CommandEncoder>,
}

/// A wgpu device bound to one window surface.
///
/// Frames are acquired lazily by the first operation that needs a target and
/// presented explicitly. The surface follows the window size on acquisition.
pub struct WgpuDevice {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    depth_view: wgpu::TextureView,

    frame: Option<GpuFrame>,
    lost: Arc<AtomicBool>,

    depth: DepthState,
    cull_back_faces: bool,
}

impl WgpuDevice {
    /// Creates the logical device and configures `surface` for it.
    pub(crate) fn new(
        window: Arc<Window>,
        surface: wgpu::Surface<'static>,
        adapter: wgpu::Adapter,
        init: &GpuInit,
    ) -> Result<Self> {
        let size = window.inner_size();
        anyhow::ensure!(size.width > 0 && size.height > 0, "window has zero size");

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("tandem device"),
            required_features: init.required_features,
            required_limits: init.required_limits.clone(),
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        }))
        .context("failed to create wgpu device/queue")?;

        let caps = surface.get_capabilities(&adapter);
        let format = surface::choose_surface_format(&caps, init.prefer_srgb)
            .context("no supported surface formats")?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width,
            height: size.height,
            present_mode: surface::choose_present_mode(&caps, init.present_mode),
            alpha_mode: surface::choose_alpha_mode(&caps, init.alpha_mode),
            view_formats: vec![],
            desired_maximum_frame_latency: init.desired_maximum_frame_latency,
        };
        surface.configure(&device, &config);

        let depth_view = surface::create_depth_view(&device, size);

        let lost = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&lost);
        device.set_device_lost_callback(move |reason, message| {
            log::error!("wgpu device lost ({reason:?}): {message}");
            flag.store(true, Ordering::Release);
        });

        let info = adapter.get_info();
        log::info!("wgpu device on {} ({:?}), surface {format:?}", info.name, info.backend);

        Ok(Self {
            window,
            surface,
            adapter,
            device,
            queue,
            config,
            size,
            depth_view,
            frame: None,
            lost,
            depth: DepthState::default(),
            cull_back_faces: false,
        })
    }

    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    pub fn downlevel_capabilities(&self) -> wgpu::DownlevelCapabilities {
        self.adapter.get_downlevel_capabilities()
    }

    /// Returns the active surface format.
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Returns the current drawable size (physical pixels).
    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn depth_state(&self) -> DepthState {
        self.depth
    }

    pub fn set_depth_state(&mut self, depth: DepthState) {
        self.depth = depth;
    }

    pub fn cull_back_faces(&self) -> bool {
        self.cull_back_faces
    }

    pub fn set_cull_back_faces(&mut self, on: bool) {
        self.cull_back_faces = on;
    }

    /// Primitive state matching the configured culling.
    pub fn primitive_state(&self) -> wgpu::PrimitiveState {
        wgpu::PrimitiveState {
            cull_mode: self.cull_back_faces.then_some(wgpu::Face::Back),
            ..Default::default()
        }
    }

    pub fn is_lost(&self) -> bool {
        self.lost.load(Ordering::Acquire)
    }

    pub fn has_frame(&self) -> bool {
        self.frame.is_some()
    }

    fn sync_size(&mut self) {
        let current = self.window.inner_size();
        if current == self.size {
            return;
        }
        let configured = surface::apply_resize(
            &self.surface,
            &self.device,
            &mut self.config,
            &mut self.size,
            current,
        );
        if configured {
            self.depth_view = surface::create_depth_view(&self.device, current);
        }
    }

    /// Acquires the next surface texture unless a frame is already open.
    pub(crate) fn acquire(&mut self) -> Result<(), DeviceFault> {
        if self.is_lost() {
            return Err(DeviceFault::Lost);
        }
        if self.frame.is_some() {
            return Ok(());
        }

        self.sync_size();
        if self.size.width == 0 || self.size.height == 0 {
            log::trace!("window minimized; skipping acquisition");
            return Err(DeviceFault::Failed);
        }

        let surface_texture = self.surface.get_current_texture().map_err(|err| {
            log::debug!("surface acquisition failed: {err}");
            surface::classify_surface_error(
                &self.surface,
                &self.device,
                &self.config,
                self.size,
                err,
            )
        })?;
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.frame = Some(GpuFrame {
            surface_texture,
            view,
            encoder: None,
        });
        Ok(())
    }

    /// Clears the frame's color target and, with `Some(depth)`, the depth buffer.
    pub(crate) fn clear(&mut self, color: wgpu::Color, depth: Option<f32>) -> Result<(), DeviceFault> {
        self.acquire()?;
        let Some(frame) = self.frame.as_mut() else {
            return Err(DeviceFault::Failed);
        };

        let device = &self.device;
        let encoder = frame.encoder.get_or_insert_with(|| {
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("tandem frame encoder"),
            })
        });

        let depth_load = match depth {
            Some(d) => wgpu::LoadOp::Clear(d.clamp(0.0, 1.0)),
            None => wgpu::LoadOp::Load,
        };

        let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("tandem clear pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &frame.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(color),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: depth_load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        Ok(())
    }

    /// Submits commands recorded for the open frame, if any.
    pub(crate) fn submit(&mut self) {
        if let Some(encoder) = self.frame.as_mut().and_then(|f| f.encoder.take()) {
            self.queue.submit(std::iter::once(encoder.finish()));
        }
    }

    /// Submits pending work and presents the open frame.
    ///
    /// Presenting with no open frame acquires one first, so an empty frame
    /// still reaches the screen.
    pub(crate) fn present(&mut self) -> Result<(), DeviceFault> {
        self.acquire()?;
        self.submit();
        match self.frame.take() {
            Some(frame) => {
                drop(frame.view);
                frame.surface_texture.present();
                Ok(())
            }
            None => Err(DeviceFault::Failed),
        }
    }

    /// Drops the open frame without presenting it.
    pub(crate) fn discard_frame(&mut self) {
        if self.frame.take().is_some() {
            log::trace!("discarding unpresented frame");
        }
    }
}

impl Drop for WgpuDevice {
    fn drop(&mut self) {
        self.discard_frame();
    }
}
