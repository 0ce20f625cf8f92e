//! Object picking.
//!
//! Picking works by rendering every entity into an off-screen `R32Sint`
//! target where each fragment holds the index of the entity it belongs to.
//! The target is cleared to `-1`, so background pixels never resolve to an
//! entity. After a left click the target is copied into a staging buffer and
//! the sample under the cursor is read back on the CPU.

use std::iter;

use thiserror::Error;
use winit::dpi::PhysicalPosition;

use crate::{
    context::Context,
    pipelines::pick::{PICK_DEPTH_FORMAT, PICK_FORMAT},
    render::Renderer,
    resources::Assets,
    world::World,
};

/// Value of pick pixels not covered by any entity.
pub const BACKGROUND: i32 = -1;

const PIXEL_SIZE: u32 = std::mem::size_of::<i32>() as u32;

#[derive(Debug, Error)]
pub enum PickError {
    #[error("pick target of {width}x{height} pixels cannot be created: {reason}")]
    Incomplete {
        width: u32,
        height: u32,
        reason: String,
    },
    #[error("failed to read back the pick buffer: {0}")]
    Readback(String),
}

/// Pixels per row of the staging buffer.
///
/// Texture to buffer copies need rows aligned to
/// [`wgpu::COPY_BYTES_PER_ROW_ALIGNMENT`] bytes, so the row is padded past the
/// viewport width.
pub fn padded_row_pixels(width: u32) -> u32 {
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    let unpadded = width * PIXEL_SIZE;
    unpadded.div_ceil(align) * align / PIXEL_SIZE
}

/// Checks that a pick target of the given size can be created and rendered to.
///
/// `usages` are the texture usages the adapter allows for [`PICK_FORMAT`].
pub fn check_complete(
    width: u32,
    height: u32,
    limits: &wgpu::Limits,
    usages: wgpu::TextureUsages,
) -> Result<(), PickError> {
    let incomplete = |reason: String| PickError::Incomplete {
        width,
        height,
        reason,
    };
    let max = limits.max_texture_dimension_2d;
    if width == 0 || height == 0 || width > max || height > max {
        return Err(incomplete(format!("each side must be within 1..={max}")));
    }
    let required = wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC;
    if !usages.contains(required) {
        return Err(incomplete(format!(
            "{PICK_FORMAT:?} supports {usages:?}, {required:?} is required"
        )));
    }
    let staging_size = u64::from(padded_row_pixels(width) * PIXEL_SIZE) * u64::from(height);
    if staging_size > limits.max_buffer_size {
        return Err(incomplete(format!(
            "staging buffer of {staging_size} bytes exceeds {}",
            limits.max_buffer_size
        )));
    }
    Ok(())
}

/// The sample at pixel `(x, y)` of a padded pick buffer.
///
/// `None` if the position lies outside the `width` × `height` viewport or
/// the buffer is too short.
pub fn sample_at(data: &[u8], x: f64, y: f64, row_pixels: u32, width: u32, height: u32) -> Option<i32> {
    if !(x >= 0.0 && y >= 0.0 && x < f64::from(width) && y < f64::from(height)) {
        return None;
    }
    let offset = (y as usize * row_pixels as usize + x as usize) * PIXEL_SIZE as usize;
    let bytes = data.get(offset..offset + PIXEL_SIZE as usize)?;
    Some(i32::from_ne_bytes(bytes.try_into().ok()?))
}

/// Maps a pick sample to an entity index.
///
/// Only samples in `0..entity_count` name an entity; the background value
/// and stale indices resolve to `None`.
pub fn resolve_pick(sample: Option<i32>, entity_count: usize) -> Option<usize> {
    sample
        .and_then(|k| usize::try_from(k).ok())
        .filter(|k| *k < entity_count)
}

/// Off-screen id target with its depth buffer and CPU readable copy.
#[derive(Debug)]
pub struct PickBuffer {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
    staging: wgpu::Buffer,
    width: u32,
    height: u32,
    row_pixels: u32,
}

impl PickBuffer {
    pub fn new(
        device: &wgpu::Device,
        limits: &wgpu::Limits,
        usages: wgpu::TextureUsages,
        width: u32,
        height: u32,
    ) -> Result<Self, PickError> {
        check_complete(width, height, limits, usages)?;

        let extent3d = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Pick texture"),
            size: extent3d,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: PICK_FORMAT,
            usage: wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        let depth_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Pick depth texture"),
            size: extent3d,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: PICK_DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        let row_pixels = padded_row_pixels(width);
        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Pick staging buffer"),
            size: u64::from(row_pixels * PIXEL_SIZE) * u64::from(height),
            // this tells wpgu that we want to read this buffer from the cpu
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        log::debug!(
            "Created {}x{} pick buffer with {} pixels per row",
            width,
            height,
            row_pixels
        );

        Ok(Self {
            view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
            depth_view: depth_texture.create_view(&wgpu::TextureViewDescriptor::default()),
            texture,
            staging,
            width,
            height,
            row_pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Render the id pass and return the sample under `cursor`.
    ///
    /// Blocks until the GPU has finished the copy. `Ok(None)` means the
    /// cursor was outside the target.
    pub fn render_and_read(
        &self,
        ctx: &Context,
        renderer: &Renderer,
        world: &World,
        assets: &Assets,
        async_runtime: &tokio::runtime::Runtime,
        cursor: PhysicalPosition<f64>,
    ) -> Result<Option<i32>, PickError> {
        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Pick Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Pick Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: f64::from(BACKGROUND),
                            g: 0.0,
                            b: 0.0,
                            a: 0.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });
            renderer.draw_ids(&mut render_pass, ctx, world, assets);
        }

        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &self.staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(self.row_pixels * PIXEL_SIZE),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );

        ctx.queue.submit(iter::once(encoder.finish()));
        async_runtime.block_on(self.read_sample(&ctx.device, cursor))
    }

    async fn read_sample(
        &self,
        device: &wgpu::Device,
        cursor: PhysicalPosition<f64>,
    ) -> Result<Option<i32>, PickError> {
        let buffer_slice = self.staging.slice(..);
        // NOTE: the mapping has to be requested before polling, otherwise the
        // receiver never resolves.
        let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let mapped = async {
            device
                .poll(wgpu::PollType::Wait {
                    submission_index: None,
                    timeout: None,
                })
                .map_err(|e| PickError::Readback(e.to_string()))?;
            rx.receive()
                .await
                .ok_or_else(|| PickError::Readback("map callback was dropped".to_string()))?
                .map_err(|e| PickError::Readback(e.to_string()))
        };
        read_mapped(&self.staging, mapped, || {
            let data = buffer_slice.get_mapped_range();
            sample_at(&data, cursor.x, cursor.y, self.row_pixels, self.width, self.height)
        })
        .await
    }
}

/// A buffer that can leave the mapped state.
trait Unmap {
    fn unmap(&self);
}

impl Unmap for wgpu::Buffer {
    fn unmap(&self) {
        wgpu::Buffer::unmap(self);
    }
}

/// Unmaps its buffer when dropped, which also cancels a map still pending.
struct MapGuard<'a, B: Unmap>(&'a B);

impl<B: Unmap> Drop for MapGuard<'_, B> {
    fn drop(&mut self) {
        self.0.unmap();
    }
}

/// Waits for `mapped` and reads the buffer with `read`.
///
/// The buffer is unmapped afterwards on every path, so a failed readback
/// does not leave it unusable for the next click.
async fn read_mapped<B, T>(
    buffer: &B,
    mapped: impl Future<Output = Result<(), PickError>>,
    read: impl FnOnce() -> T,
) -> Result<T, PickError>
where
    B: Unmap,
{
    let _guard = MapGuard(buffer);
    mapped.await?;
    Ok(read())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usable() -> wgpu::TextureUsages {
        wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::COPY_SRC
            | wgpu::TextureUsages::COPY_DST
    }

    #[test]
    fn rows_are_padded_to_256_bytes() {
        assert_eq!(padded_row_pixels(64), 64);
        assert_eq!(padded_row_pixels(65), 128);
        assert_eq!(padded_row_pixels(800), 832);
        assert_eq!(padded_row_pixels(1), 64);
    }

    #[test]
    fn sample_uses_the_padded_row_stride() {
        let (width, height) = (3, 2);
        let row = padded_row_pixels(width);
        let mut pixels = vec![BACKGROUND; (row * height) as usize];
        pixels[(row + 2) as usize] = 7;
        let data: Vec<u8> = pixels.iter().flat_map(|p| p.to_ne_bytes()).collect();

        assert_eq!(sample_at(&data, 2.0, 1.0, row, width, height), Some(7));
        assert_eq!(sample_at(&data, 2.9, 1.5, row, width, height), Some(7));
        assert_eq!(sample_at(&data, 0.0, 0.0, row, width, height), Some(BACKGROUND));
    }

    #[test]
    fn cursor_outside_the_target_has_no_sample() {
        let data = vec![0u8; 64 * 4 * 2];
        assert_eq!(sample_at(&data, -1.0, 0.0, 64, 3, 2), None);
        assert_eq!(sample_at(&data, 3.0, 0.0, 64, 3, 2), None);
        assert_eq!(sample_at(&data, 0.0, 2.0, 64, 3, 2), None);
        assert_eq!(sample_at(&data[..4], 1.0, 1.0, 64, 3, 2), None);
    }

    #[test]
    fn only_in_range_samples_resolve() {
        assert_eq!(resolve_pick(Some(0), 3), Some(0));
        assert_eq!(resolve_pick(Some(2), 3), Some(2));
        assert_eq!(resolve_pick(Some(3), 3), None);
        assert_eq!(resolve_pick(Some(BACKGROUND), 3), None);
        assert_eq!(resolve_pick(Some(i32::MIN), 3), None);
        assert_eq!(resolve_pick(None, 3), None);
        assert_eq!(resolve_pick(Some(0), 0), None);
    }

    #[test]
    fn oversized_target_is_incomplete() {
        let limits = wgpu::Limits::default();
        let too_wide = limits.max_texture_dimension_2d + 1;
        assert!(matches!(
            check_complete(too_wide, 1, &limits, usable()),
            Err(PickError::Incomplete { .. })
        ));
        assert!(check_complete(0, 600, &limits, usable()).is_err());
        assert!(check_complete(800, 600, &limits, usable()).is_ok());
    }

    #[derive(Default)]
    struct CountingBuffer {
        unmaps: std::cell::Cell<usize>,
    }

    impl Unmap for CountingBuffer {
        fn unmap(&self) {
            self.unmaps.set(self.unmaps.get() + 1);
        }
    }

    #[test]
    fn failed_readback_unmaps_the_staging_buffer() {
        let buffer = CountingBuffer::default();
        let failed = async { Err(PickError::Readback("device lost".to_string())) };
        let result = futures::executor::block_on(read_mapped(&buffer, failed, || {
            panic!("a failed mapping must not be read")
        }));
        assert!(matches!(result, Err(PickError::Readback(_))));
        assert_eq!(buffer.unmaps.get(), 1);
    }

    #[test]
    fn successful_readback_unmaps_after_reading() {
        let buffer = CountingBuffer::default();
        let sample = futures::executor::block_on(read_mapped(&buffer, async { Ok(()) }, || {
            assert_eq!(buffer.unmaps.get(), 0);
            Some(4)
        }));
        assert_eq!(sample.unwrap(), Some(4));
        assert_eq!(buffer.unmaps.get(), 1);
    }

    #[test]
    fn format_without_render_attachment_is_incomplete() {
        let limits = wgpu::Limits::default();
        let err = check_complete(800, 600, &limits, wgpu::TextureUsages::COPY_SRC).unwrap_err();
        assert!(err.to_string().contains("800x600"));
    }
}
