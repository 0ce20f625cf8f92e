//! GPU textures and texture creation utilities.
//!
//! This module provides [`Texture`], a wrapper around WGPU texture resources,
//! and helpers for depth textures, single-colour fallbacks and textures
//! decoded from image files. Sampling state is not part of a texture: the
//! renderer binds one shared sampler for every material.

use anyhow::*;
use image::{GenericImageView, ImageFormat, load_from_memory_with_format};

/// A GPU texture and its default view.
#[derive(Clone, Debug)]
pub struct Texture {
    texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

/// Descriptor of a depth attachment. It is only rendered to, never sampled.
pub(crate) fn depth_descriptor(size: wgpu::Extent3d, label: &str) -> wgpu::TextureDescriptor<'_> {
    wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: Texture::DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    }
}

/// Descriptor of an sRGB colour texture filled from the CPU.
pub(crate) fn colour_descriptor(size: wgpu::Extent3d, label: Option<&str>) -> wgpu::TextureDescriptor<'_> {
    wgpu::TextureDescriptor {
        label,
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    }
}

impl Texture {
    /// Standard depth buffer texture format (32-bit float).
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Create a depth texture for depth-testing during rendering.
    ///
    /// * `size` is [width, height] of the texture in pixels
    /// * `label` is used as a debug label for the GPU resource
    pub fn create_depth_texture(device: &wgpu::Device, size: [u32; 2], label: &str) -> Self {
        let size = wgpu::Extent3d {
            width: size[0].max(1),
            height: size[1].max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&depth_descriptor(size, label));
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    /// Create a 1×1 texture of a single colour.
    ///
    /// Entities without a texture in some slot (or whose texture failed to
    /// load) are drawn with one of these so the pipelines never change.
    pub fn create_solid(
        rgba: [u8; 4],
        label: &str,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> Texture {
        Self::upload(device, queue, &rgba, [1, 1], Some(label))
    }

    /// Load a texture from raw byte data (image file contents).
    ///
    /// * `bytes` represent raw image file data (PNG, JPEG, etc.)
    /// * `label` is used as a debug name for the GPU resource
    /// * `format` is an optional file format hint (e.g., "png"). If None, auto-detect.
    pub fn from_bytes(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        bytes: &[u8],
        label: &str,
        format: Option<&str>,
    ) -> Result<Self> {
        let img = match format.and_then(ImageFormat::from_extension) {
            None => image::load_from_memory(bytes)?,
            Some(fmt) => load_from_memory_with_format(bytes, fmt)?,
        };
        Ok(Self::from_image(device, queue, &img, Some(label)))
    }

    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        img: &image::DynamicImage,
        label: Option<&str>,
    ) -> Self {
        let (width, height) = img.dimensions();
        Self::upload(device, queue, &img.to_rgba8(), [width, height], label)
    }

    fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rgba: &[u8],
        [width, height]: [u32; 2],
        label: Option<&str>,
    ) -> Self {
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&colour_descriptor(size, label));

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    pub fn width(&self) -> u32 {
        self.texture.width()
    }

    pub fn height(&self) -> u32 {
        self.texture.height()
    }
}

/// Nearest-neighbour sampler; block textures are 16×16 pixel art.
pub fn create_default_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Nearest,
        min_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extent(width: u32, height: u32) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        }
    }

    #[test]
    fn depth_target_is_attachment_only() {
        let desc = depth_descriptor(extent(800, 600), "depth");
        assert_eq!(desc.usage, wgpu::TextureUsages::RENDER_ATTACHMENT);
        assert!(desc.view_formats.is_empty());
        assert_eq!(desc.format, Texture::DEPTH_FORMAT);
    }

    #[test]
    fn colour_textures_are_sampled_not_rendered() {
        let desc = colour_descriptor(extent(16, 16), Some("bricks"));
        assert!(desc.usage.contains(wgpu::TextureUsages::TEXTURE_BINDING));
        assert!(!desc.usage.contains(wgpu::TextureUsages::RENDER_ATTACHMENT));
        assert_eq!(desc.format, wgpu::TextureFormat::Rgba8UnormSrgb);
    }
}
