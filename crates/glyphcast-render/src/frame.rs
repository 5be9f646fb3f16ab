//! Per-frame orchestration of the text and point passes.

use tracing::{debug, info, trace, warn};

use crate::atlas::{AtlasTexture, FontAtlas};
use crate::camera::Camera;
use crate::context::GpuContext;
use crate::error::{RenderError, RenderResult};
use crate::frame_context::FrameContext;
use crate::layout::GlyphInstance;
use crate::point::PointInstance;
use crate::point_pass::PointPass;
use crate::text_pass::TextPass;
use crate::types::{Color, Size};

/// Renderer configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    /// Glyphs the text buffers hold before their first growth.
    pub initial_glyph_capacity: usize,
    /// Points the instance buffer holds before its first growth.
    pub initial_point_capacity: usize,
    /// Triangles in the shared point mesh.
    pub circle_segments: u32,
    /// Clear color used by [`FrameRenderer::frame_context`].
    pub clear_color: Color,
    /// Text color used by [`FrameRenderer::frame_context`].
    pub text_color: Color,
}

impl RendererConfig {
    pub fn with_initial_glyph_capacity(mut self, glyphs: usize) -> Self {
        self.initial_glyph_capacity = glyphs;
        self
    }

    pub fn with_initial_point_capacity(mut self, points: usize) -> Self {
        self.initial_point_capacity = points;
        self
    }

    pub fn with_circle_segments(mut self, segments: u32) -> Self {
        self.circle_segments = segments;
        self
    }

    pub fn with_clear_color(mut self, color: Color) -> Self {
        self.clear_color = color;
        self
    }

    pub fn with_text_color(mut self, color: Color) -> Self {
        self.text_color = color;
        self
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            initial_glyph_capacity: 1024,
            initial_point_capacity: 64,
            circle_segments: 16,
            clear_color: Color::BLACK,
            text_color: Color::WHITE,
        }
    }
}

/// Statistics about a rendered frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Draw calls recorded.
    pub draw_calls: u32,
    /// Glyph quads drawn.
    pub glyphs: usize,
    /// Point instances drawn.
    pub points: usize,
    /// Vertices processed, counting each instanced mesh vertex.
    pub vertices: u64,
}

/// Viewport size and the camera that follows it.
#[derive(Debug, Clone, Default, PartialEq)]
struct ViewState {
    size: (u32, u32),
    camera: Option<Camera>,
}

impl ViewState {
    /// Returns false when the size did not change.
    fn resize(&mut self, width: u32, height: u32) -> bool {
        if self.size == (width, height) {
            return false;
        }
        self.size = (width, height);
        if let Some(camera) = &mut self.camera {
            camera.set_aspect_ratio(width, height);
        }
        true
    }

    fn set_camera(&mut self, camera: Option<Camera>) {
        self.camera = camera.map(|mut camera| {
            camera.set_aspect_ratio(self.size.0, self.size.1);
            camera
        });
    }

    fn frame_context(&self, config: &RendererConfig) -> FrameContext {
        let frame = FrameContext::for_viewport(self.size.0, self.size.1)
            .with_text_color(config.text_color)
            .with_clear_color(config.clear_color);
        match &self.camera {
            Some(camera) => frame.with_point_mvp(camera.view_projection()),
            None => frame,
        }
    }
}

/// Draws glyph quads and point markers into a color target.
///
/// Each [`render`](Self::render) records one encoder with one render pass:
/// clear, text, then points.
pub struct FrameRenderer {
    format: wgpu::TextureFormat,
    config: RendererConfig,
    view: ViewState,
    atlas: AtlasTexture,
    text: TextPass,
    points: PointPass,
}

impl FrameRenderer {
    /// Create both pipelines and upload `atlas`.
    ///
    /// The viewport starts at 0x0; call [`resize`](Self::resize) before the
    /// first frame.
    pub fn new(
        ctx: &GpuContext,
        format: wgpu::TextureFormat,
        atlas: &dyn FontAtlas,
        config: RendererConfig,
    ) -> RenderResult<Self> {
        let atlas = AtlasTexture::new(ctx, atlas)?;
        let text = TextPass::new(ctx, format, &atlas, config.initial_glyph_capacity);
        let points = PointPass::new(
            ctx,
            format,
            config.circle_segments,
            config.initial_point_capacity,
        );

        info!(
            target: "glyphcast_render::frame",
            format = ?format,
            atlas = ?atlas.size(),
            "created frame renderer"
        );

        Ok(Self {
            format,
            config,
            view: ViewState::default(),
            atlas,
            text,
            points,
        })
    }

    /// Set the viewport size in pixels.
    ///
    /// Only the projections of later frame contexts change, including the
    /// camera's aspect ratio; laid-out glyphs stay valid.
    pub fn resize(&mut self, width: u32, height: u32) {
        if self.view.resize(width, height) {
            debug!(
                target: "glyphcast_render::frame",
                width,
                height,
                "resized viewport"
            );
        }
    }

    /// Current viewport size.
    pub fn viewport(&self) -> Size {
        Size::new(self.view.size.0 as f32, self.view.size.1 as f32)
    }

    /// Place points with `camera` instead of in editor pixels.
    ///
    /// The camera's aspect ratio follows the viewport from now on. `None`
    /// goes back to editor pixels.
    pub fn set_camera(&mut self, camera: Option<Camera>) {
        self.view.set_camera(camera);
    }

    pub fn camera(&self) -> Option<&Camera> {
        self.view.camera.as_ref()
    }

    /// Camera for orbit, pan and dolly input.
    pub fn camera_mut(&mut self) -> Option<&mut Camera> {
        self.view.camera.as_mut()
    }

    /// Color target format the pipelines were built for.
    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Frame context for the current viewport, camera and configured colors.
    pub fn frame_context(&self) -> FrameContext {
        self.view.frame_context(&self.config)
    }

    /// Use `atlas` for later frames.
    ///
    /// An atlas of the current size is re-uploaded in place; any other size
    /// gets a new texture and bind group.
    pub fn set_atlas(&mut self, ctx: &GpuContext, atlas: &dyn FontAtlas) -> RenderResult<()> {
        if atlas.dimensions() == self.atlas.size() {
            return self.atlas.update(ctx, atlas);
        }

        let texture = AtlasTexture::new(ctx, atlas)?;
        self.text.set_atlas(ctx, &texture);
        self.atlas = texture;
        debug!(
            target: "glyphcast_render::frame",
            atlas = ?self.atlas.size(),
            "replaced atlas"
        );
        Ok(())
    }

    /// Render one frame into `target`.
    ///
    /// The glyph and point slices are copied during the call and may be
    /// reused as soon as it returns.
    ///
    /// # Errors
    ///
    /// [`RenderError::FrameDropped`] for an empty viewport and
    /// [`RenderError::Gpu`] when the device runs out of memory.
    pub fn render(
        &mut self,
        ctx: &GpuContext,
        target: &wgpu::TextureView,
        frame: &FrameContext,
        glyphs: &[GlyphInstance],
        points: &[PointInstance],
    ) -> RenderResult<FrameStats> {
        if frame.is_empty() {
            warn!(
                target: "glyphcast_render::frame",
                viewport = ?frame.viewport,
                "dropping frame with empty viewport"
            );
            return Err(RenderError::frame_dropped("viewport is empty"));
        }

        let device = ctx.device();
        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);

        self.text.prepare(ctx, frame, glyphs);
        self.points.prepare(ctx, frame, points);

        let mut stats = FrameStats {
            glyphs: glyphs.len(),
            points: points.len(),
            ..FrameStats::default()
        };

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("frame_encoder"),
        });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("frame_render_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(frame.clear_color.to_wgpu()),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if self.text.draw(&mut pass) {
                stats.draw_calls += 1;
                stats.vertices += glyphs.len() as u64 * 4;
            }
            if self.points.draw(&mut pass) {
                stats.draw_calls += 1;
                stats.vertices += points.len() as u64 * self.points.mesh_vertex_count() as u64;
            }
        }
        ctx.queue().submit(std::iter::once(encoder.finish()));

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            warn!(
                target: "glyphcast_render::frame",
                error = %err,
                "gpu error during frame"
            );
            return Err(err.into());
        }

        trace!(
            target: "glyphcast_render::frame",
            draw_calls = stats.draw_calls,
            glyphs = stats.glyphs,
            points = stats.points,
            "rendered frame"
        );

        Ok(stats)
    }

    /// Acquire the next surface texture, render into it and present it.
    ///
    /// A lost, outdated or timed-out surface drops the frame; the caller
    /// should reconfigure the surface if needed and try again next tick.
    pub fn render_to_surface(
        &mut self,
        ctx: &GpuContext,
        surface: &wgpu::Surface<'_>,
        frame: &FrameContext,
        glyphs: &[GlyphInstance],
        points: &[PointInstance],
    ) -> RenderResult<FrameStats> {
        if frame.is_empty() {
            return Err(RenderError::frame_dropped("viewport is empty"));
        }

        let output = match surface.get_current_texture() {
            Ok(output) => output,
            Err(
                err @ (wgpu::SurfaceError::Lost
                | wgpu::SurfaceError::Outdated
                | wgpu::SurfaceError::Timeout),
            ) => {
                warn!(
                    target: "glyphcast_render::frame",
                    error = %err,
                    "dropping frame, surface unavailable"
                );
                return Err(RenderError::frame_dropped(err.to_string()));
            }
            Err(err) => return Err(err.into()),
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let stats = self.render(ctx, &view, frame, glyphs, points)?;
        output.present();
        Ok(stats)
    }
}

impl std::fmt::Debug for FrameRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameRenderer")
            .field("format", &self.format)
            .field("viewport", &self.view.size)
            .field("camera", &self.view.camera)
            .field("atlas", &self.atlas)
            .finish()
    }
}
