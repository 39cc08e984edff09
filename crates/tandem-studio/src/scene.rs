use anyhow::{bail, Result};

use tandem_engine::backend::Context;
use tandem_engine::core::{App, AppControl, FrameCtx};
use tandem_engine::render::{
    EffectHandle, FrameReport, MaterialHandle, MeshHandle, RenderQueue, Renderable, ResourceBinder,
};

/// Binder with no GPU resources behind it: every step is traced.
///
/// Meshes at or above `mesh_count` are unknown and fail to draw, which
/// exercises the per-renderable error path.
pub struct TraceBinder {
    mesh_count: u32,
}

impl TraceBinder {
    pub fn new(mesh_count: u32) -> Self {
        Self { mesh_count }
    }
}

impl ResourceBinder for TraceBinder {
    fn bind_effect(&mut self, effect: EffectHandle, context: Context) -> Result<()> {
        log::trace!("{context:?}: bind effect {}", effect.0);
        Ok(())
    }

    fn set_material_uniforms(&mut self, material: MaterialHandle, context: Context) -> Result<()> {
        log::trace!("{context:?}: material {} uniforms", material.id);
        Ok(())
    }

    fn set_material_textures(&mut self, material: MaterialHandle, context: Context) -> Result<()> {
        log::trace!("{context:?}: material {} textures", material.id);
        Ok(())
    }

    fn set_draw_call_uniforms(&mut self, effect: EffectHandle, context: Context) -> Result<()> {
        log::trace!("{context:?}: effect {} draw-call uniforms", effect.0);
        Ok(())
    }

    fn draw_mesh(&mut self, mesh: MeshHandle, context: Context) -> Result<()> {
        if mesh.0 >= self.mesh_count {
            bail!("mesh {} is not loaded", mesh.0);
        }
        log::trace!("{context:?}: draw mesh {}", mesh.0);
        Ok(())
    }
}

/// Demo scene: a fixed set of renderables every frame, all sharing one effect.
pub struct Studio {
    binder: TraceBinder,
    renderables: u32,
    dropped: usize,
}

impl Studio {
    pub fn new(renderables: u32, loaded_meshes: u32) -> Self {
        Self {
            binder: TraceBinder::new(loaded_meshes),
            renderables,
            dropped: 0,
        }
    }

    fn fill(&self, queue: &mut RenderQueue) {
        let effect = EffectHandle(0);
        queue.extend((0..self.renderables).map(|i| {
            Renderable::new(MeshHandle(i), MaterialHandle::new(i % 4, effect))
        }));
    }
}

impl App for Studio {
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_>) -> AppControl {
        if ctx.frame_index == 0 {
            let (w, h) = ctx.window.physical_size();
            log::info!("{} backend, {w}x{h}", ctx.backend);
        }
        self.fill(ctx.queue);
        AppControl::Continue
    }

    fn binder(&mut self) -> &mut dyn ResourceBinder {
        &mut self.binder
    }

    fn on_frame_rendered(&mut self, report: &FrameReport) -> AppControl {
        self.dropped += report.submitted - report.drawn;
        if !report.presented {
            log::warn!("frame {} was not presented", report.frame_index);
        }
        AppControl::Continue
    }
}

impl Drop for Studio {
    fn drop(&mut self) {
        if self.dropped > 0 {
            log::info!("{} renderable(s) dropped in total", self.dropped);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tandem_engine::render::RenderableSource;

    #[test]
    fn fills_queue_in_mesh_order() {
        let studio = Studio::new(3, 3);
        let mut q = RenderQueue::new();
        studio.fill(&mut q);

        assert_eq!(q.len(), 3);
        let meshes: Vec<u32> = q.iter().map(|r| r.mesh.0).collect();
        assert_eq!(meshes, [0, 1, 2]);
    }

    #[test]
    fn unknown_mesh_fails_to_draw() {
        let mut b = TraceBinder::new(1);
        let ctx = Context::from_raw(1);
        assert!(b.draw_mesh(MeshHandle(0), ctx).is_ok());
        let err = b.draw_mesh(MeshHandle(1), ctx).unwrap_err();
        assert_eq!(err.to_string(), "mesh 1 is not loaded");
    }
}
