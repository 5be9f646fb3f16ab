//! GPU text rendering pass.
//!
//! Glyph quads are expanded into four vertices each and drawn with one
//! indexed draw. Bindings (group 0): the uniform block `{ projection,
//! text_color }` at 0, the atlas coverage texture at 1 and its sampler at 2.

use bytemuck::{Pod, Zeroable};
use tracing::debug;

use crate::atlas::AtlasTexture;
use crate::buffer::GrowableBuffer;
use crate::context::GpuContext;
use crate::frame_context::FrameContext;
use crate::layout::GlyphInstance;

/// Flag bit: sample coverage dilated.
pub const GLYPH_FLAG_BOLD: u32 = 1;
/// Flag bit: the quad was skewed on the CPU.
pub const GLYPH_FLAG_ITALIC: u32 = 2;

/// Vertex for text rendering.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TextVertex {
    /// Position in editor space.
    pub position: [f32; 2],
    /// Atlas texture coordinates.
    pub tex_coord: [f32; 2],
    /// Format color (premultiplied alpha).
    pub color: [f32; 4],
    /// Synthesis flags.
    pub flags: u32,
}

impl TextVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        0 => Float32x2, // position
        1 => Float32x2, // tex_coord
        2 => Float32x4, // color
        3 => Uint32,    // flags
    ];

    fn buffer_layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// Uniforms for text rendering (80 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct TextUniforms {
    /// Editor-space to clip-space projection.
    pub projection: [[f32; 4]; 4],
    /// Global text color (premultiplied alpha).
    pub text_color: [f32; 4],
}

impl TextUniforms {
    /// Uniforms for one frame.
    pub fn from_frame(frame: &FrameContext) -> Self {
        Self {
            projection: frame.projection.to_cols_array_2d(),
            text_color: frame.text_color.to_array(),
        }
    }
}

/// Expand a glyph into its quad corners: top-left, top-right,
/// bottom-right, bottom-left.
pub fn glyph_vertices(glyph: &GlyphInstance) -> [TextVertex; 4] {
    let r = glyph.rect;
    let t = glyph.tex_rect;
    let color = glyph.color.to_array();

    let mut flags = 0;
    if glyph.synthesize.bold {
        flags |= GLYPH_FLAG_BOLD;
    }
    if glyph.synthesize.italic {
        flags |= GLYPH_FLAG_ITALIC;
    }

    let vertex = |x: f32, y: f32, u: f32, v: f32| TextVertex {
        position: [x, y],
        tex_coord: [u, v],
        color,
        flags,
    };

    [
        vertex(r.left() + glyph.skew, r.top(), t.left(), t.top()),
        vertex(r.right() + glyph.skew, r.top(), t.right(), t.top()),
        vertex(r.right(), r.bottom(), t.right(), t.bottom()),
        vertex(r.left(), r.bottom(), t.left(), t.bottom()),
    ]
}

/// A pass for rendering glyph quads.
pub struct TextPass {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group_layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    vertex_buffer: GrowableBuffer,
    index_buffer: GrowableBuffer,
    vertices: Vec<TextVertex>,
    indices: Vec<u32>,
    index_count: u32,
}

impl TextPass {
    /// Create the pipeline and buffers sized for `initial_glyphs` glyphs.
    pub fn new(
        ctx: &GpuContext,
        format: wgpu::TextureFormat,
        atlas: &AtlasTexture,
        initial_glyphs: usize,
    ) -> Self {
        let device = ctx.device();

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("text_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/text.wgsl").into()),
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("text_uniform_buffer"),
            size: std::mem::size_of::<TextUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("text_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let bind_group = create_bind_group(device, &bind_group_layout, &uniform_buffer, atlas);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("text_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("text_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[TextVertex::buffer_layout()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });

        let glyphs = initial_glyphs.max(1) as u64;
        let vertex_buffer = GrowableBuffer::new(
            device,
            "text_vertex_buffer",
            wgpu::BufferUsages::VERTEX,
            glyphs * 4 * std::mem::size_of::<TextVertex>() as u64,
        );
        let index_buffer = GrowableBuffer::new(
            device,
            "text_index_buffer",
            wgpu::BufferUsages::INDEX,
            glyphs * 6 * std::mem::size_of::<u32>() as u64,
        );

        debug!(
            target: "glyphcast_render::text",
            format = ?format,
            initial_glyphs,
            "created text pipeline"
        );

        Self {
            pipeline,
            uniform_buffer,
            bind_group_layout,
            bind_group,
            vertex_buffer,
            index_buffer,
            vertices: Vec::new(),
            indices: Vec::new(),
            index_count: 0,
        }
    }

    /// Bind a different atlas texture.
    pub fn set_atlas(&mut self, ctx: &GpuContext, atlas: &AtlasTexture) {
        self.bind_group = create_bind_group(
            ctx.device(),
            &self.bind_group_layout,
            &self.uniform_buffer,
            atlas,
        );
    }

    /// Write this frame's uniforms and upload the glyph quads.
    pub fn prepare(&mut self, ctx: &GpuContext, frame: &FrameContext, glyphs: &[GlyphInstance]) {
        let queue = ctx.queue();
        queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::cast_slice(&[TextUniforms::from_frame(frame)]),
        );

        self.vertices.clear();
        self.indices.clear();
        for glyph in glyphs {
            let base = self.vertices.len() as u32;
            self.vertices.extend_from_slice(&glyph_vertices(glyph));
            self.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        self.vertex_buffer
            .write(ctx.device(), queue, bytemuck::cast_slice(&self.vertices));
        self.index_buffer
            .write(ctx.device(), queue, bytemuck::cast_slice(&self.indices));
        self.index_count = self.indices.len() as u32;
    }

    /// Record the draw into `pass`. Returns false when there was nothing to draw.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) -> bool {
        if self.index_count == 0 {
            return false;
        }
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.buffer().slice(..));
        pass.set_index_buffer(
            self.index_buffer.buffer().slice(..),
            wgpu::IndexFormat::Uint32,
        );
        pass.draw_indexed(0..self.index_count, 0, 0..1);
        true
    }

    /// Number of glyphs prepared for the next draw.
    pub fn glyph_count(&self) -> usize {
        self.index_count as usize / 6
    }
}

impl std::fmt::Debug for TextPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextPass")
            .field("prepared_glyphs", &self.glyph_count())
            .finish()
    }
}

fn create_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    uniform_buffer: &wgpu::Buffer,
    atlas: &AtlasTexture,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("text_bind_group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(atlas.view()),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(atlas.sampler()),
            },
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::GlyphStyle;
    use crate::types::{Color, Rect};

    fn glyph(synthesize: GlyphStyle, skew: f32) -> GlyphInstance {
        GlyphInstance {
            rect: Rect::new(10.0, 20.0, 8.0, 16.0),
            tex_rect: Rect::new(0.25, 0.5, 0.0625, 0.125),
            color: Color::RED,
            synthesize,
            skew,
            char_index: 0,
        }
    }

    #[test]
    fn test_layout_sizes() {
        assert_eq!(std::mem::size_of::<TextUniforms>(), 80);
        assert_eq!(std::mem::size_of::<TextVertex>(), 36);
    }

    #[test]
    fn test_quad_corners() {
        let v = glyph_vertices(&glyph(GlyphStyle::REGULAR, 0.0));
        assert_eq!(v[0].position, [10.0, 20.0]);
        assert_eq!(v[1].position, [18.0, 20.0]);
        assert_eq!(v[2].position, [18.0, 36.0]);
        assert_eq!(v[3].position, [10.0, 36.0]);
        assert_eq!(v[0].tex_coord, [0.25, 0.5]);
        assert_eq!(v[2].tex_coord, [0.3125, 0.625]);
        assert!(v.iter().all(|v| v.flags == 0 && v.color == [1.0, 0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_synthesized_styles() {
        let v = glyph_vertices(&glyph(GlyphStyle::BOLD_ITALIC, 3.2));
        // Only the top edge moves.
        assert_eq!(v[0].position, [13.2, 20.0]);
        assert_eq!(v[1].position, [21.2, 20.0]);
        assert_eq!(v[3].position, [10.0, 36.0]);
        assert_eq!(v[0].flags, GLYPH_FLAG_BOLD | GLYPH_FLAG_ITALIC);
    }

    #[test]
    fn test_uniforms_from_frame() {
        let frame = FrameContext::for_viewport(800, 600).with_text_color(Color::GREEN);
        let uniforms = TextUniforms::from_frame(&frame);
        assert_eq!(uniforms.text_color, [0.0, 1.0, 0.0, 1.0]);
        assert_eq!(uniforms.projection, frame.projection.to_cols_array_2d());
    }
}
