//! Scene entities.
//!
//! An [`Entity`] is plain data: GPU resources are referenced through
//! [`ModelId`] / [`TextureId`] handles into [`crate::resources::Assets`], and
//! the pipeline that draws it is picked by its [`ShaderKind`].

use instant::Duration;

use crate::{data_structures::instance::Transform, fire::FireAnimation};

/// Handle to a texture registered in [`crate::resources::Assets`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub usize);

/// Handle to a model registered in [`crate::resources::Assets`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId(pub usize);

/// Selects the render pipeline (and its material parameters) for an entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderKind {
    /// Lit block with alpha cutout.
    Standard,
    /// Like `Standard` but double sided and swaying in the wind.
    Foliage,
    /// Three textures: albedo on the sides, specular slot on top, emission slot below.
    Flat,
    /// Alpha blended and drawn after everything else.
    Fire,
}

impl ShaderKind {
    pub const ALL: [ShaderKind; 4] = [
        ShaderKind::Standard,
        ShaderKind::Foliage,
        ShaderKind::Flat,
        ShaderKind::Fire,
    ];

    pub fn index(self) -> usize {
        match self {
            ShaderKind::Standard => 0,
            ShaderKind::Foliage => 1,
            ShaderKind::Flat => 2,
            ShaderKind::Fire => 3,
        }
    }
}

/// Everything an update callback may read besides the entity itself.
pub struct UpdateCtx<'w> {
    pub dt: Duration,
    /// Seconds since the world was created.
    pub time: f32,
    pub fire: &'w FireAnimation,
}

/// Per-frame behaviour attached to an entity.
pub type UpdateFn = fn(&UpdateCtx<'_>, &mut Entity);

#[derive(Clone, Debug)]
pub struct Entity {
    pub tag: String,
    pub active: bool,
    pub transform: Transform,
    /// RGB multiplier applied on top of the albedo texture.
    pub color: [f32; 3],
    pub model: ModelId,
    pub shader: ShaderKind,
    pub albedo: Option<TextureId>,
    pub specular: Option<TextureId>,
    pub emission: Option<TextureId>,
    pub update: Option<UpdateFn>,
}

impl Entity {
    pub fn new(tag: impl Into<String>, model: ModelId, shader: ShaderKind) -> Self {
        Self {
            tag: tag.into(),
            active: true,
            transform: Transform::new(),
            color: [1.0; 3],
            model,
            shader,
            albedo: None,
            specular: None,
            emission: None,
            update: None,
        }
    }

    pub fn with_position(mut self, position: cgmath::Vector3<f32>) -> Self {
        self.transform.position = position;
        self
    }

    pub fn with_textures(
        mut self,
        albedo: Option<TextureId>,
        specular: Option<TextureId>,
        emission: Option<TextureId>,
    ) -> Self {
        self.albedo = albedo;
        self.specular = specular;
        self.emission = emission;
        self
    }

    pub fn with_update(mut self, update: UpdateFn) -> Self {
        self.update = Some(update);
        self
    }
}

/// Placeholder behaviour for rotating blocks. The demo keeps them still.
pub fn rotate(_: &UpdateCtx<'_>, _: &mut Entity) {}
