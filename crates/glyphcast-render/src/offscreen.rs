//! Offscreen render targets for headless rendering and pixel readback.
//!
//! [`OffscreenTarget`] renders into a plain texture instead of a window
//! surface, which is what the GPU tests and screenshot tooling use.

use tracing::{debug, info};

use crate::context::GpuContext;
use crate::error::{RenderError, RenderResult};

/// Configuration for an offscreen target.
#[derive(Debug, Clone)]
pub struct OffscreenConfig {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Texture format. Defaults to `Rgba8Unorm`.
    pub format: Option<wgpu::TextureFormat>,
}

impl OffscreenConfig {
    /// Create a config with the given dimensions.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            format: None,
        }
    }

    /// Set a specific texture format.
    pub fn with_format(mut self, format: wgpu::TextureFormat) -> Self {
        self.format = Some(format);
        self
    }
}

impl Default for OffscreenConfig {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

/// Row layout of a texture-to-buffer copy.
///
/// `bytes_per_row` of a copy must be a multiple of 256.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferDimensions {
    pub width: u32,
    pub height: u32,
    pub bytes_per_pixel: u32,
    pub unpadded_bytes_per_row: u32,
    pub padded_bytes_per_row: u32,
}

impl BufferDimensions {
    pub fn new(width: u32, height: u32, bytes_per_pixel: u32) -> Self {
        let unpadded_bytes_per_row = width * bytes_per_pixel;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        Self {
            width,
            height,
            bytes_per_pixel,
            unpadded_bytes_per_row,
            padded_bytes_per_row: unpadded_bytes_per_row.div_ceil(align) * align,
        }
    }

    /// Row layout for reading back a `format` texture.
    ///
    /// # Errors
    ///
    /// [`RenderError::UnsupportedFormat`] for block-compressed formats and
    /// formats whose aspects cannot be copied together, such as
    /// `Depth24PlusStencil8`.
    pub fn for_format(width: u32, height: u32, format: wgpu::TextureFormat) -> RenderResult<Self> {
        match format.block_copy_size(None) {
            Some(bytes) if format.block_dimensions() == (1, 1) => Ok(Self::new(width, height, bytes)),
            _ => Err(RenderError::UnsupportedFormat(format)),
        }
    }

    /// Total readback buffer size in bytes.
    pub fn buffer_size(&self) -> u64 {
        self.padded_bytes_per_row as u64 * self.height as u64
    }

    /// Strip the row padding from mapped buffer contents.
    pub fn unpad(&self, data: &[u8]) -> Vec<u8> {
        let mut pixels =
            Vec::with_capacity(self.unpadded_bytes_per_row as usize * self.height as usize);
        for row in data
            .chunks(self.padded_bytes_per_row as usize)
            .take(self.height as usize)
        {
            pixels.extend_from_slice(&row[..self.unpadded_bytes_per_row as usize]);
        }
        pixels
    }
}

/// A texture render target with no window.
pub struct OffscreenTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
}

impl OffscreenTarget {
    /// Create a target.
    ///
    /// # Errors
    ///
    /// [`RenderError::InvalidDimensions`] when either side is zero and
    /// [`RenderError::UnsupportedFormat`] when the format cannot be read back.
    pub fn new(ctx: &GpuContext, config: OffscreenConfig) -> RenderResult<Self> {
        if config.width == 0 || config.height == 0 {
            return Err(RenderError::InvalidDimensions {
                width: config.width,
                height: config.height,
            });
        }

        let format = config.format.unwrap_or(wgpu::TextureFormat::Rgba8Unorm);
        BufferDimensions::for_format(config.width, config.height, format)?;
        let texture = create_texture(ctx, config.width, config.height, format);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        info!(
            target: "glyphcast_render::offscreen",
            width = config.width,
            height = config.height,
            format = ?format,
            "created offscreen target"
        );

        Ok(Self {
            texture,
            view,
            width: config.width,
            height: config.height,
            format,
        })
    }

    /// Recreate the texture at a new size.
    pub fn resize(&mut self, ctx: &GpuContext, width: u32, height: u32) -> RenderResult<()> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidDimensions { width, height });
        }
        if self.width == width && self.height == height {
            return Ok(());
        }

        self.texture = create_texture(ctx, width, height, self.format);
        self.view = self
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.width = width;
        self.height = height;

        debug!(
            target: "glyphcast_render::offscreen",
            width,
            height,
            "resized offscreen target"
        );
        Ok(())
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// Dimensions as (width, height).
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Copy the target back to the CPU as tightly packed rows in the
    /// target's format.
    ///
    /// Blocks until the GPU has finished the copy.
    pub fn read_pixels(&self, ctx: &GpuContext) -> RenderResult<Vec<u8>> {
        let device = ctx.device();
        let dims = BufferDimensions::for_format(self.width, self.height, self.format)?;

        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("offscreen_readback_buffer"),
            size: dims.buffer_size(),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("offscreen_readback_encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(dims.padded_bytes_per_row),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        ctx.queue().submit(std::iter::once(encoder.finish()));

        let slice = readback.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            // The receiver only goes away if this function already returned.
            let _ = sender.send(result);
        });
        ctx.poll(wgpu::Maintain::Wait);

        receiver
            .recv()
            .map_err(|_| RenderError::Gpu("readback channel closed".into()))?
            .map_err(|e| RenderError::Gpu(format!("failed to map readback buffer: {e}")))?;

        let pixels = dims.unpad(&slice.get_mapped_range());
        readback.unmap();

        debug!(
            target: "glyphcast_render::offscreen",
            width = self.width,
            height = self.height,
            bytes = pixels.len(),
            "read back pixels"
        );

        Ok(pixels)
    }
}

impl std::fmt::Debug for OffscreenTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OffscreenTarget")
            .field("size", &(self.width, self.height))
            .field("format", &self.format)
            .finish()
    }
}

fn create_texture(
    ctx: &GpuContext,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
) -> wgpu::Texture {
    ctx.device().create_texture(&wgpu::TextureDescriptor {
        label: Some("offscreen_render_target"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config() {
        let config = OffscreenConfig::default();
        assert_eq!((config.width, config.height), (800, 600));
        assert!(config.format.is_none());

        let config = OffscreenConfig::new(64, 32).with_format(wgpu::TextureFormat::Bgra8Unorm);
        assert_eq!(config.format, Some(wgpu::TextureFormat::Bgra8Unorm));
    }

    #[test]
    fn test_buffer_dimensions() {
        // 64 * 4 = 256 is already aligned.
        let dims = BufferDimensions::new(64, 100, 4);
        assert_eq!(dims.padded_bytes_per_row, 256);
        assert_eq!(dims.buffer_size(), 256 * 100);

        // 100 * 4 = 400 pads to 512.
        let dims = BufferDimensions::new(100, 10, 4);
        assert_eq!(dims.unpadded_bytes_per_row, 400);
        assert_eq!(dims.padded_bytes_per_row, 512);
    }

    #[test]
    fn test_buffer_dimensions_follow_format() {
        use wgpu::TextureFormat;

        let bgra = BufferDimensions::for_format(100, 10, TextureFormat::Bgra8UnormSrgb).unwrap();
        assert_eq!(bgra.bytes_per_pixel, 4);

        // Eight bytes per pixel: 100 * 8 = 800 pads to 1024.
        let half = BufferDimensions::for_format(100, 10, TextureFormat::Rgba16Float).unwrap();
        assert_eq!(half.unpadded_bytes_per_row, 800);
        assert_eq!(half.padded_bytes_per_row, 1024);

        let r8 = BufferDimensions::for_format(100, 10, TextureFormat::R8Unorm).unwrap();
        assert_eq!(r8.unpadded_bytes_per_row, 100);

        assert!(matches!(
            BufferDimensions::for_format(4, 4, TextureFormat::Depth24PlusStencil8),
            Err(RenderError::UnsupportedFormat(_))
        ));
        assert!(BufferDimensions::for_format(4, 4, TextureFormat::Bc1RgbaUnorm).is_err());
    }

    #[test]
    fn test_unpad() {
        let dims = BufferDimensions::new(2, 2, 4);
        let mut data = vec![0u8; dims.buffer_size() as usize];
        data[..8].copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
        data[256..264].copy_from_slice(&[9, 10, 11, 12, 13, 14, 15, 16]);

        let pixels = dims.unpad(&data);
        assert_eq!(pixels, (1..=16).collect::<Vec<u8>>());
    }
}
