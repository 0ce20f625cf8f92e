use std::{
    io::{BufReader, Cursor},
    path::{Path, PathBuf},
};

use anyhow::Context as _;

use crate::{
    data_structures::{model, texture::Texture},
    entity::{ModelId, TextureId},
};

/**
 * This module contains all logic for loading meshes and textures from asset files
 * and the registry that hands out handles to them.
 */
pub mod mesh;
pub mod texture;

pub async fn load_string(root: &Path, file_name: &str) -> anyhow::Result<String> {
    let path = root.join(file_name);
    tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}

pub async fn load_binary(root: &Path, file_name: &str) -> anyhow::Result<Vec<u8>> {
    let path = root.join(file_name);
    tokio::fs::read(&path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}

/// Load the geometry of an `.obj` file. Materials referenced by the file are
/// ignored: entities bring their own textures.
pub async fn load_model_obj(
    root: &Path,
    file_name: &str,
    device: &wgpu::Device,
) -> anyhow::Result<model::Model> {
    let obj_text = load_string(root, file_name).await?;
    let mut obj_reader = BufReader::new(Cursor::new(obj_text));

    let (models, _) = tobj::load_obj_buf_async(
        &mut obj_reader,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
        |_| async move { Err(tobj::LoadError::OpenFileFailed) },
    )
    .await
    .with_context(|| format!("failed to parse model {file_name}"))?;

    let meshes = mesh::load_meshes(&models, file_name, device);
    if meshes.is_empty() {
        anyhow::bail!("model {file_name} contains no meshes");
    }
    Ok(model::Model { meshes })
}

/// Owner of every texture and model the scene uses.
///
/// Gameplay code only holds [`TextureId`] / [`ModelId`] handles; the renderer
/// resolves them here. Empty texture slots resolve to 1×1 fallbacks.
#[derive(Debug)]
pub struct Assets {
    root: PathBuf,
    textures: Vec<Texture>,
    models: Vec<model::Model>,
    white: Texture,
    black: Texture,
}

impl Assets {
    pub fn new(root: impl Into<PathBuf>, device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self {
            root: root.into(),
            textures: Vec::new(),
            models: Vec::new(),
            white: Texture::create_solid([255; 4], "fallback white", device, queue),
            black: Texture::create_solid([0, 0, 0, 255], "fallback black", device, queue),
        }
    }

    /// Load a texture and register it.
    ///
    /// A texture that fails to load is logged and yields `None`; the entity
    /// using it is drawn with a fallback instead.
    pub async fn load_texture(
        &mut self,
        file_name: &str,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> Option<TextureId> {
        let result = texture::load_texture(&self.root, file_name, device, queue).await;
        self.register(file_name, result)
    }

    /// Load several textures concurrently, keeping the order of `file_names`.
    pub async fn load_textures(
        &mut self,
        file_names: &[String],
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> Vec<Option<TextureId>> {
        let root = self.root.clone();
        let loaded = futures::future::join_all(
            file_names
                .iter()
                .map(|file| texture::load_texture(&root, file, device, queue)),
        )
        .await;
        file_names
            .iter()
            .zip(loaded)
            .map(|(file, result)| self.register(file, result))
            .collect()
    }

    fn register(&mut self, file_name: &str, result: anyhow::Result<Texture>) -> Option<TextureId> {
        match result {
            Ok(tex) => {
                log::info!(
                    "Successfully loaded texture: {} ({}x{})",
                    file_name,
                    tex.width(),
                    tex.height()
                );
                self.textures.push(tex);
                Some(TextureId(self.textures.len() - 1))
            }
            Err(e) => {
                log::error!("Failed to load texture: {}: {:#}", file_name, e);
                None
            }
        }
    }

    pub async fn load_model(
        &mut self,
        file_name: &str,
        device: &wgpu::Device,
    ) -> anyhow::Result<ModelId> {
        let model = load_model_obj(&self.root, file_name, device).await?;
        log::info!(
            "Loaded model {} with {} meshes",
            file_name,
            model.meshes.len()
        );
        self.models.push(model);
        Ok(ModelId(self.models.len() - 1))
    }

    pub fn texture(&self, id: TextureId) -> Option<&Texture> {
        self.textures.get(id.0)
    }

    /// Texture for an albedo slot; empty slots are white.
    pub fn albedo_or_white(&self, id: Option<TextureId>) -> &Texture {
        id.and_then(|id| self.texture(id)).unwrap_or(&self.white)
    }

    /// Texture for a specular or emission slot; empty slots are black.
    pub fn map_or_black(&self, id: Option<TextureId>) -> &Texture {
        id.and_then(|id| self.texture(id)).unwrap_or(&self.black)
    }

    pub fn model(&self, id: ModelId) -> Option<&model::Model> {
        self.models.get(id.0)
    }
}
