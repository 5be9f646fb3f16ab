//! GPU point marker pass.
//!
//! One unit-circle mesh is shared by every point and drawn instanced.
//! Vertex slot 0 is the mesh (location 0), slot 1 the per-instance data
//! (locations 1 to 4). The uniform block at group 0 binding 0 holds the
//! point MVP.

use bytemuck::{Pod, Zeroable};
use tracing::debug;
use wgpu::util::DeviceExt;

use crate::buffer::GrowableBuffer;
use crate::context::GpuContext;
use crate::frame_context::FrameContext;
use crate::point::{PointInstance, unit_circle_mesh};

/// Mesh vertex of the unit circle.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PointVertex {
    pub position: [f32; 3],
}

impl PointVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];

    fn buffer_layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// Per-instance GPU data for one point.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PointInstanceRaw {
    pub point_size: f32,
    pub offset: [f32; 2],
    pub center: [f32; 3],
    pub color: [f32; 4],
}

impl PointInstanceRaw {
    const ATTRIBS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        1 => Float32,   // point_size
        2 => Float32x2, // offset
        3 => Float32x3, // center
        4 => Float32x4, // color
    ];

    fn buffer_layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBS,
        }
    }
}

impl From<&PointInstance> for PointInstanceRaw {
    fn from(point: &PointInstance) -> Self {
        Self {
            point_size: point.size,
            offset: point.offset.to_array(),
            center: point.center.to_array(),
            color: point.color.to_array(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct PointUniforms {
    mvp: [[f32; 4]; 4],
}

/// A pass for rendering instanced point markers.
pub struct PointPass {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    mesh_buffer: wgpu::Buffer,
    mesh_vertex_count: u32,
    instance_buffer: GrowableBuffer,
    staging: Vec<PointInstanceRaw>,
    instance_count: u32,
}

impl PointPass {
    /// Create the pipeline, the shared mesh and room for `initial_points`.
    pub fn new(
        ctx: &GpuContext,
        format: wgpu::TextureFormat,
        circle_segments: u32,
        initial_points: usize,
    ) -> Self {
        let device = ctx.device();

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("point_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/point.wgsl").into()),
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("point_uniform_buffer"),
            size: std::mem::size_of::<PointUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("point_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("point_bind_group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("point_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("point_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[PointVertex::buffer_layout(), PointInstanceRaw::buffer_layout()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
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

        let mesh: Vec<PointVertex> = unit_circle_mesh(circle_segments)
            .into_iter()
            .map(|position| PointVertex { position })
            .collect();
        let mesh_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("point_mesh_buffer"),
            contents: bytemuck::cast_slice(&mesh),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let instance_buffer = GrowableBuffer::new(
            device,
            "point_instance_buffer",
            wgpu::BufferUsages::VERTEX,
            initial_points.max(1) as u64 * std::mem::size_of::<PointInstanceRaw>() as u64,
        );

        debug!(
            target: "glyphcast_render::point",
            format = ?format,
            mesh_vertices = mesh.len(),
            initial_points,
            "created point pipeline"
        );

        Self {
            pipeline,
            uniform_buffer,
            bind_group,
            mesh_buffer,
            mesh_vertex_count: mesh.len() as u32,
            instance_buffer,
            staging: Vec::new(),
            instance_count: 0,
        }
    }

    /// Write this frame's MVP and upload the instances.
    pub fn prepare(&mut self, ctx: &GpuContext, frame: &FrameContext, points: &[PointInstance]) {
        let queue = ctx.queue();
        let uniforms = PointUniforms {
            mvp: frame.point_mvp.to_cols_array_2d(),
        };
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        self.staging.clear();
        self.staging.extend(points.iter().map(PointInstanceRaw::from));
        self.instance_buffer
            .write(ctx.device(), queue, bytemuck::cast_slice(&self.staging));
        self.instance_count = self.staging.len() as u32;
    }

    /// Record the draw into `pass`. Returns false when there was nothing to draw.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) -> bool {
        if self.instance_count == 0 {
            return false;
        }
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, self.mesh_buffer.slice(..));
        pass.set_vertex_buffer(1, self.instance_buffer.buffer().slice(..));
        pass.draw(0..self.mesh_vertex_count, 0..self.instance_count);
        true
    }

    /// Number of points prepared for the next draw.
    pub fn point_count(&self) -> usize {
        self.instance_count as usize
    }

    /// Vertices in the shared circle mesh.
    pub fn mesh_vertex_count(&self) -> u32 {
        self.mesh_vertex_count
    }
}

impl std::fmt::Debug for PointPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PointPass")
            .field("mesh_vertices", &self.mesh_vertex_count)
            .field("prepared_points", &self.instance_count)
            .finish()
    }
}
