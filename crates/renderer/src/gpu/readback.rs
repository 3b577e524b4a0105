use image::RgbaImage;

use crate::error::RenderError;

use super::context::OffscreenTarget;

const BYTES_PER_PIXEL: u32 = 4;

/// Byte length of a tightly packed RGBA image, computed in `usize` so large
/// surfaces do not overflow `u32`.
fn unpadded_len(width: u32, height: u32) -> usize {
    width as usize * BYTES_PER_PIXEL as usize * height as usize
}

/// Copies the offscreen target back to host memory, blocking until the GPU
/// has finished every submitted draw.
pub(crate) fn read_offscreen(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    target: &OffscreenTarget,
) -> Result<RgbaImage, RenderError> {
    let width = target.size.width.max(1);
    let height = target.size.height.max(1);
    let unpadded_bytes_per_row = width * BYTES_PER_PIXEL;
    let padded_bytes_per_row = unpadded_bytes_per_row
        .div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
        * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("readback buffer"),
        size: u64::from(padded_bytes_per_row) * u64::from(height),
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("readback encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture: &target.texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_bytes_per_row),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    queue.submit(std::iter::once(encoder.finish()));

    let slice = buffer.slice(..);
    let (sender, receiver) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });
    device
        .poll(wgpu::PollType::Wait)
        .map_err(|err| RenderError::Readback(err.to_string()))?;
    receiver
        .recv()
        .map_err(|_| RenderError::Readback("map callback was dropped".into()))?
        .map_err(|err| RenderError::Readback(err.to_string()))?;

    let mut pixels = Vec::with_capacity(unpadded_len(width, height));
    {
        let data = slice.get_mapped_range();
        for row in data.chunks_exact(padded_bytes_per_row as usize) {
            pixels.extend_from_slice(&row[..unpadded_bytes_per_row as usize]);
        }
    }
    buffer.unmap();

    tracing::debug!(width, height, "read back drawing surface");
    RgbaImage::from_raw(width, height, pixels)
        .ok_or_else(|| RenderError::Readback("readback size does not match the surface".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpadded_len_matches_pixel_count() {
        assert_eq!(unpadded_len(3, 2), 24);
        assert_eq!(unpadded_len(1, 1), 4);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn unpadded_len_does_not_overflow_at_large_limits() {
        assert_eq!(unpadded_len(32_768, 32_768), 1_usize << 32);
    }
}
