use anyhow::Result;

use crate::backend::{BindStep, Context};

/// Loaded mesh, owned by the resource layer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct MeshHandle(pub u32);

/// Loaded effect (shader program), owned by the resource layer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct EffectHandle(pub u32);

/// Loaded material. Every material renders with exactly one effect.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct MaterialHandle {
    pub id: u32,
    pub effect: EffectHandle,
}

impl MaterialHandle {
    #[inline]
    pub const fn new(id: u32, effect: EffectHandle) -> Self {
        Self { id, effect }
    }
}

/// One drawable: a mesh rendered with a material.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Renderable {
    pub mesh: MeshHandle,
    pub material: MaterialHandle,
}

impl Renderable {
    #[inline]
    pub const fn new(mesh: MeshHandle, material: MaterialHandle) -> Self {
        Self { mesh, material }
    }

    #[inline]
    pub const fn effect(&self) -> EffectHandle {
        self.material.effect
    }
}

/// Binds resources and issues draws against the live device.
///
/// The renderer calls these in [`BindStep::ORDER`] for every renderable,
/// between begin and end frame. The context is only valid for the current
/// frame; implementations must not release it.
pub trait ResourceBinder {
    fn bind_effect(&mut self, effect: EffectHandle, context: Context) -> Result<()>;

    fn set_material_uniforms(&mut self, material: MaterialHandle, context: Context) -> Result<()>;

    fn set_material_textures(&mut self, material: MaterialHandle, context: Context) -> Result<()>;

    fn set_draw_call_uniforms(&mut self, effect: EffectHandle, context: Context) -> Result<()>;

    fn draw_mesh(&mut self, mesh: MeshHandle, context: Context) -> Result<()>;
}

/// Runs every bind step for `renderable`, stopping at the first failure.
pub(crate) fn bind_and_draw<B>(
    binder: &mut B,
    renderable: &Renderable,
    context: Context,
) -> std::result::Result<(), (BindStep, anyhow::Error)>
where
    B: ResourceBinder + ?Sized,
{
    for step in BindStep::ORDER {
        let result = match step {
            BindStep::Effect => binder.bind_effect(renderable.effect(), context),
            BindStep::MaterialUniforms => binder.set_material_uniforms(renderable.material, context),
            BindStep::MaterialTextures => binder.set_material_textures(renderable.material, context),
            BindStep::DrawCallUniforms => binder.set_draw_call_uniforms(renderable.effect(), context),
            BindStep::Mesh => binder.draw_mesh(renderable.mesh, context),
        };
        result.map_err(|e| (step, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        steps: Vec<&'static str>,
        fail_at: Option<&'static str>,
    }

    impl Recorder {
        fn step(&mut self, name: &'static str) -> Result<()> {
            self.steps.push(name);
            if self.fail_at == Some(name) {
                anyhow::bail!("{name} refused");
            }
            Ok(())
        }
    }

    impl ResourceBinder for Recorder {
        fn bind_effect(&mut self, _: EffectHandle, _: Context) -> Result<()> {
            self.step("effect")
        }
        fn set_material_uniforms(&mut self, _: MaterialHandle, _: Context) -> Result<()> {
            self.step("material uniforms")
        }
        fn set_material_textures(&mut self, _: MaterialHandle, _: Context) -> Result<()> {
            self.step("material textures")
        }
        fn set_draw_call_uniforms(&mut self, _: EffectHandle, _: Context) -> Result<()> {
            self.step("draw-call uniforms")
        }
        fn draw_mesh(&mut self, _: MeshHandle, _: Context) -> Result<()> {
            self.step("mesh")
        }
    }

    fn renderable() -> Renderable {
        Renderable::new(MeshHandle(1), MaterialHandle::new(2, EffectHandle(3)))
    }

    #[test]
    fn steps_run_in_order() {
        let mut b = Recorder::default();
        bind_and_draw(&mut b, &renderable(), Context::from_raw(1)).unwrap();
        assert_eq!(
            b.steps,
            ["effect", "material uniforms", "material textures", "draw-call uniforms", "mesh"]
        );
    }

    #[test]
    fn first_failure_stops_the_renderable() {
        let mut b = Recorder {
            fail_at: Some("material uniforms"),
            ..Default::default()
        };
        let (step, err) = bind_and_draw(&mut b, &renderable(), Context::from_raw(1)).unwrap_err();
        assert_eq!(step, BindStep::MaterialUniforms);
        assert_eq!(err.to_string(), "material uniforms refused");
        assert_eq!(b.steps, ["effect", "material uniforms"]);
    }
}
