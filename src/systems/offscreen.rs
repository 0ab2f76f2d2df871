//! Off-screen render target and readback
//!
//! Frames are rendered into a texture and copied back to host memory, since
//! the renderer has no window to present to.

use std::path::Path;

use image::error::{ImageError, ParameterError, ParameterErrorKind};
use image::RgbaImage;

/// Format of every off-screen target
pub const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

const BYTES_PER_PIXEL: u32 = 4;

/// Row pitch of a texture copy, rounded up to wgpu's copy alignment
pub fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * BYTES_PER_PIXEL;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Bytes of a staging buffer holding a padded `width x height` copy
pub fn staging_size(width: u32, height: u32) -> u64 {
    padded_bytes_per_row(width) as u64 * height as u64
}

/// An RGBA8 image read back from the GPU
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA rows, top to bottom
    pub pixels: Vec<u8>,
}

impl Image {
    /// Drop the per-row padding of a texture copy
    pub fn from_padded(width: u32, height: u32, padded_row: u32, data: &[u8]) -> Self {
        let row = (width * BYTES_PER_PIXEL) as usize;
        let mut pixels = Vec::with_capacity(row * height as usize);
        for chunk in data.chunks(padded_row as usize).take(height as usize) {
            pixels.extend_from_slice(&chunk[..row]);
        }
        Self { width, height, pixels }
    }

    /// RGBA value at `(x, y)`
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y * self.width + x) * BYTES_PER_PIXEL) as usize;
        self.pixels.get(i..i + 4).and_then(|p| p.try_into().ok())
    }

    /// As an `image` buffer, `None` if the pixel data is short
    pub fn to_rgba_image(&self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
    }

    /// Encode and write the image, format chosen by the path extension
    pub fn save(&self, path: &Path) -> Result<(), ImageError> {
        let img = self.to_rgba_image().ok_or_else(|| {
            ImageError::Parameter(ParameterError::from_kind(ParameterErrorKind::DimensionMismatch))
        })?;
        img.save(path)
    }
}

/// Color texture plus the staging buffer it is copied into
pub struct OffscreenTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    staging: wgpu::Buffer,
    width: u32,
    height: u32,
    padded_row: u32,
}

impl OffscreenTarget {
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Offscreen Target"),
            size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let padded_row = padded_bytes_per_row(width);
        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Offscreen Staging"),
            size: staging_size(width, height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        Self { texture, view, staging, width, height, padded_row }
    }

    #[inline]
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Copy the target into host memory, waiting for the GPU
    pub fn read(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> Result<Image, wgpu::BufferAsyncError> {
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Offscreen Readback"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &self.staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(self.padded_row),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d { width: self.width, height: self.height, depth_or_array_layers: 1 },
        );
        queue.submit(std::iter::once(encoder.finish()));

        let slice = self.staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            // The receiver outlives the poll below
            let _ = tx.send(result);
        });
        device.poll(wgpu::Maintain::Wait);
        rx.recv().map_err(|_| wgpu::BufferAsyncError)??;

        let image = {
            let data = slice.get_mapped_range();
            Image::from_padded(self.width, self.height, self.padded_row, &data)
        };
        self.staging.unmap();
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padded_bytes_per_row() {
        assert_eq!(padded_bytes_per_row(64), 256);
        assert_eq!(padded_bytes_per_row(65), 512);
        assert_eq!(padded_bytes_per_row(1), 256);
    }

    #[test]
    fn test_staging_size_does_not_wrap() {
        assert_eq!(staging_size(64, 2), 512);
        // 16384 * 4 bytes per row times 65536 rows is 2^32
        assert_eq!(staging_size(16384, 65536), 1u64 << 32);
    }

    #[test]
    fn test_from_padded_strips_rows() {
        let padded = padded_bytes_per_row(2) as usize;
        let mut data = vec![0u8; padded * 2];
        data[..8].copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
        data[padded..padded + 8].copy_from_slice(&[9, 10, 11, 12, 13, 14, 15, 16]);

        let image = Image::from_padded(2, 2, padded as u32, &data);
        assert_eq!(image.pixels.len(), 16);
        assert_eq!(image.pixel(1, 0), Some([5, 6, 7, 8]));
        assert_eq!(image.pixel(0, 1), Some([9, 10, 11, 12]));
        assert_eq!(image.pixel(2, 0), None);
    }

    #[test]
    fn test_rgba_image_layout() {
        let image = Image { width: 2, height: 1, pixels: vec![255, 0, 0, 255, 0, 255, 0, 128] };
        let img = image.to_rgba_image().unwrap();
        assert_eq!(img.dimensions(), (2, 1));
        assert_eq!(img.get_pixel(1, 0).0, [0, 255, 0, 128]);
    }

    #[test]
    fn test_short_pixel_data_rejected() {
        let image = Image { width: 2, height: 2, pixels: vec![0; 8] };
        assert!(image.to_rgba_image().is_none());
        let path = std::env::temp_dir().join(format!("tetvol_short_{}.png", std::process::id()));
        assert!(matches!(image.save(&path), Err(ImageError::Parameter(_))));
        assert!(!path.exists());
    }

    #[test]
    fn test_save_png_round_trips() {
        let image = Image { width: 3, height: 2, pixels: (0..24).collect() };
        let path = std::env::temp_dir().join(format!("tetvol_frame_{}.png", std::process::id()));
        image.save(&path).unwrap();

        let loaded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(loaded.dimensions(), (3, 2));
        assert_eq!(loaded.into_raw(), image.pixels);
        std::fs::remove_file(&path).unwrap();
    }
}
