//! Font atlas contract and GPU coverage texture.
//!
//! Glyph bitmaps are baked elsewhere; this crate only consumes them through
//! [`FontAtlas`]. An atlas stores single-channel coverage, so one atlas
//! serves every text color. [`GridAtlas`] describes the common fixed-cell
//! monospace layout. [`AtlasTexture`] uploads any atlas into an `R8Unorm`
//! texture for the text pass.

use tracing::{debug, info};

use crate::context::GpuContext;
use crate::error::{RenderError, RenderResult};
use crate::types::{Point, Rect, Size};

/// Bold/italic selection for a glyph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct GlyphStyle {
    pub bold: bool,
    pub italic: bool,
}

impl GlyphStyle {
    /// Upright, normal weight.
    pub const REGULAR: Self = Self {
        bold: false,
        italic: false,
    };
    pub const BOLD: Self = Self {
        bold: true,
        italic: false,
    };
    pub const ITALIC: Self = Self {
        bold: false,
        italic: true,
    };
    pub const BOLD_ITALIC: Self = Self {
        bold: true,
        italic: true,
    };

    /// Create a style.
    pub const fn new(bold: bool, italic: bool) -> Self {
        Self { bold, italic }
    }
}

/// One glyph as stored in an atlas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtlasGlyph {
    /// Normalized texture rectangle (u, v, width, height in 0..1).
    pub tex_rect: Rect,
    /// Quad size in pixels.
    pub size: Size,
    /// Quad top-left relative to the pen at the top of the line.
    pub offset: Point,
    /// Horizontal pen advance in pixels.
    pub advance: f32,
    /// Style the bitmap was baked with.
    pub style: GlyphStyle,
}

/// Line metrics of an atlas font.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontMetrics {
    /// Distance between baselines.
    pub line_height: f32,
    /// Distance from the top of the line to the baseline.
    pub ascent: f32,
    /// Advance of a space, used for tab stops.
    pub space_advance: f32,
}

/// Source of glyph bitmaps and placement.
pub trait FontAtlas {
    /// Look up a glyph, preferring a bitmap baked in `style`.
    ///
    /// An atlas without the requested variant returns its closest baked
    /// glyph; [`AtlasGlyph::style`] says which one it is.
    fn glyph(&self, ch: char, style: GlyphStyle) -> Option<AtlasGlyph>;

    /// Glyph drawn for characters the atlas does not contain.
    fn fallback_glyph(&self) -> AtlasGlyph;

    /// Line metrics.
    fn metrics(&self) -> FontMetrics;

    /// Coverage bitmap size in pixels.
    fn dimensions(&self) -> (u32, u32);

    /// Row-major coverage bytes, one per pixel.
    fn coverage(&self) -> &[u8];
}

/// Placement of glyphs in a [`GridAtlas`].
#[derive(Debug, Clone, PartialEq)]
pub struct GridLayout {
    /// Cell width in pixels (also the advance).
    pub cell_width: u32,
    /// Cell height in pixels (also the line height).
    pub cell_height: u32,
    /// Cells per row.
    pub columns: u32,
    /// Character stored in the first cell.
    pub first_char: char,
    /// Number of consecutive characters stored.
    pub glyph_count: u32,
    /// Style of each stacked plane, top to bottom.
    pub styles: Vec<GlyphStyle>,
    /// Character used for missing glyphs.
    pub fallback_char: char,
}

impl GridLayout {
    /// Printable ASCII (32..128) in 16 columns, one regular plane.
    pub fn ascii(cell_width: u32, cell_height: u32) -> Self {
        Self {
            cell_width,
            cell_height,
            columns: 16,
            first_char: ' ',
            glyph_count: 96,
            styles: vec![GlyphStyle::REGULAR],
            fallback_char: '?',
        }
    }

    /// Replace the stacked style planes.
    pub fn with_styles(mut self, styles: impl Into<Vec<GlyphStyle>>) -> Self {
        self.styles = styles.into();
        self
    }

    fn rows_per_plane(&self) -> u32 {
        self.glyph_count.div_ceil(self.columns.max(1))
    }

    /// Coverage bitmap size for this layout.
    pub fn dimensions(&self) -> (u32, u32) {
        (
            self.columns.saturating_mul(self.cell_width),
            self.rows_per_plane()
                .saturating_mul(self.styles.len() as u32)
                .saturating_mul(self.cell_height),
        )
    }
}

/// A fixed-cell monospace atlas.
#[derive(Debug, Clone)]
pub struct GridAtlas {
    layout: GridLayout,
    width: u32,
    height: u32,
    coverage: Vec<u8>,
}

impl GridAtlas {
    /// Wrap baked coverage laid out as described by `layout`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidDimensions`] when the layout is empty or
    /// the coverage length does not match it.
    pub fn new(layout: GridLayout, coverage: Vec<u8>) -> RenderResult<Self> {
        let (width, height) = layout.dimensions();
        if width == 0 || height == 0 || coverage.len() != width as usize * height as usize {
            return Err(RenderError::InvalidDimensions { width, height });
        }
        Ok(Self {
            layout,
            width,
            height,
            coverage,
        })
    }

    /// An atlas where every glyph except space is a solid block.
    ///
    /// Useful where real glyph shapes do not matter.
    pub fn block(cell_width: u32, cell_height: u32) -> RenderResult<Self> {
        let layout = GridLayout::ascii(cell_width, cell_height);
        let (width, height) = layout.dimensions();
        let mut coverage = vec![255u8; width as usize * height as usize];

        // Clear the space cell.
        for y in 0..cell_height {
            let row = y as usize * width as usize;
            coverage[row..row + cell_width as usize].fill(0);
        }

        Self::new(layout, coverage)
    }

    /// The grid layout.
    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    fn cell(&self, ch: char, plane: usize, style: GlyphStyle) -> Option<AtlasGlyph> {
        let index = (ch as u32).checked_sub(self.layout.first_char as u32)?;
        if index >= self.layout.glyph_count {
            return None;
        }

        let l = &self.layout;
        let col = index % l.columns;
        let row = index / l.columns + plane as u32 * l.rows_per_plane();
        let (w, h) = (self.width as f32, self.height as f32);

        Some(AtlasGlyph {
            tex_rect: Rect::new(
                (col * l.cell_width) as f32 / w,
                (row * l.cell_height) as f32 / h,
                l.cell_width as f32 / w,
                l.cell_height as f32 / h,
            ),
            size: Size::new(l.cell_width as f32, l.cell_height as f32),
            offset: Point::ZERO,
            advance: l.cell_width as f32,
            style,
        })
    }
}

impl FontAtlas for GridAtlas {
    fn glyph(&self, ch: char, style: GlyphStyle) -> Option<AtlasGlyph> {
        // Closest plane that adds no style the caller did not ask for.
        let styles = &self.layout.styles;
        let (plane, baked) = styles
            .iter()
            .enumerate()
            .filter(|(_, s)| (!s.bold || style.bold) && (!s.italic || style.italic))
            .max_by_key(|(_, s)| u8::from(s.bold) + u8::from(s.italic))
            .map_or((0, styles.first().copied().unwrap_or_default()), |(i, s)| (i, *s));
        self.cell(ch, plane, baked)
    }

    fn fallback_glyph(&self) -> AtlasGlyph {
        let l = &self.layout;
        self.glyph(l.fallback_char, GlyphStyle::REGULAR)
            .or_else(|| self.glyph(l.first_char, GlyphStyle::REGULAR))
            .unwrap_or(AtlasGlyph {
                tex_rect: Rect::ZERO,
                size: Size::new(l.cell_width as f32, l.cell_height as f32),
                offset: Point::ZERO,
                advance: l.cell_width as f32,
                style: GlyphStyle::REGULAR,
            })
    }

    fn metrics(&self) -> FontMetrics {
        let l = &self.layout;
        FontMetrics {
            line_height: l.cell_height as f32,
            ascent: l.cell_height as f32 * 0.8,
            space_advance: l.cell_width as f32,
        }
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn coverage(&self) -> &[u8] {
        &self.coverage
    }
}

/// An atlas's coverage uploaded to the GPU.
pub struct AtlasTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
    width: u32,
    height: u32,
}

impl AtlasTexture {
    /// Create an `R8Unorm` texture and upload the atlas coverage.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::AtlasTooLarge`] when the atlas exceeds the
    /// device's texture limit and [`RenderError::InvalidDimensions`] when the
    /// coverage does not match the reported size.
    pub fn new(ctx: &GpuContext, atlas: &dyn FontAtlas) -> RenderResult<Self> {
        let (width, height) = atlas.dimensions();
        validate(ctx, atlas)?;

        let texture = ctx.device().create_texture(&wgpu::TextureDescriptor {
            label: Some("glyph_atlas"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = ctx.device().create_sampler(&wgpu::SamplerDescriptor {
            label: Some("glyph_atlas_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let this = Self {
            texture,
            view,
            sampler,
            width,
            height,
        };
        this.upload(ctx, atlas.coverage());

        info!(
            target: "glyphcast_render::atlas",
            width,
            height,
            "uploaded glyph atlas"
        );

        Ok(this)
    }

    /// Re-upload coverage from an atlas of the same size.
    pub fn update(&self, ctx: &GpuContext, atlas: &dyn FontAtlas) -> RenderResult<()> {
        let (width, height) = atlas.dimensions();
        if (width, height) != (self.width, self.height) {
            return Err(RenderError::InvalidDimensions { width, height });
        }
        validate(ctx, atlas)?;
        self.upload(ctx, atlas.coverage());

        debug!(
            target: "glyphcast_render::atlas",
            width,
            height,
            "updated glyph atlas"
        );
        Ok(())
    }

    fn upload(&self, ctx: &GpuContext, coverage: &[u8]) {
        ctx.queue().write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            coverage,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(self.width),
                rows_per_image: Some(self.height),
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
    }

    /// Texture view for binding.
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    /// Sampler for binding.
    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    /// Texture size in pixels.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl std::fmt::Debug for AtlasTexture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtlasTexture")
            .field("size", &(self.width, self.height))
            .finish()
    }
}

fn validate(ctx: &GpuContext, atlas: &dyn FontAtlas) -> RenderResult<()> {
    let (width, height) = atlas.dimensions();
    if width == 0 || height == 0 || atlas.coverage().len() != (width as usize * height as usize) {
        return Err(RenderError::InvalidDimensions { width, height });
    }
    let max = ctx.max_texture_dimension();
    if width > max || height > max {
        return Err(RenderError::AtlasTooLarge { width, height, max });
    }
    Ok(())
}
