//! GPU batch renderer for Glyphcast.
//!
//! This crate turns styled spans from `glyphcast-syntax` into glyph quads
//! and draws them, together with instanced point markers, using wgpu.
//!
//! # Getting Started
//!
//! Create a [`GpuContext`] (or wrap a device the host already owns with
//! [`GpuContext::from_device`]) and a [`FrameRenderer`] for the color target
//! format:
//!
//! ```no_run
//! use glyphcast_render::{
//!     FrameRenderer, GpuContext, GraphicsConfig, GridAtlas, GlyphLayout,
//!     OffscreenConfig, OffscreenTarget, Point, RendererConfig,
//! };
//! use glyphcast_syntax::{LanguageRegistry, tokenize};
//!
//! # fn example() -> glyphcast_render::RenderResult<()> {
//! let ctx = GpuContext::new(&GraphicsConfig::default())?;
//! let target = OffscreenTarget::new(&ctx, OffscreenConfig::new(640, 480))?;
//!
//! let atlas = GridAtlas::block(8, 16)?;
//! let mut renderer = FrameRenderer::new(&ctx, target.format(), &atlas, RendererConfig::default())?;
//! renderer.resize(640, 480);
//!
//! let registry = LanguageRegistry::with_builtins();
//! let source = "def main():\n    pass\n";
//! let spans = tokenize(source, &registry.for_path("main.py"));
//! let run = GlyphLayout::default().layout(source, &spans, &atlas, Point::new(4.0, 4.0));
//!
//! let frame = renderer.frame_context();
//! renderer.render(&ctx, target.view(), &frame, &run.glyphs, &[])?;
//! # Ok(())
//! # }
//! ```
//!
//! # Frames
//!
//! Projection and colors live in a [`FrameContext`] value passed to every
//! `render` call, so nothing is global. A resize only changes the next
//! frame context's projection; laid-out glyphs stay valid.
//!
//! [`FrameRenderer::render_to_surface`] turns lost, outdated and timed-out
//! surfaces into [`RenderError::FrameDropped`]; check
//! [`RenderError::is_frame_dropped`] and retry on the next tick.
//!
//! # Points
//!
//! [`PointBatcher`] collects markers drawn as discs that stay round for any
//! projection, since the aspect correction is read from the MVP itself.
//! By default they share the text projection and are placed in editor
//! pixels; [`FrameRenderer::set_camera`] places them in world space with an
//! orbit [`Camera`] whose aspect ratio follows every resize.

mod atlas;
mod buffer;
mod camera;
mod context;
mod error;
mod frame;
mod frame_context;
mod layout;
mod offscreen;
mod point;
mod point_pass;
mod text_pass;
mod types;

// Core types
pub use context::{GpuContext, GraphicsConfig};
pub use error::{RenderError, RenderResult};
pub use types::{Color, Point, Rect, Size};

// Atlas and layout
pub use atlas::{AtlasGlyph, AtlasTexture, FontAtlas, FontMetrics, GlyphStyle, GridAtlas, GridLayout};
pub use layout::{GlyphInstance, GlyphLayout, GlyphRun, LayoutConfig};

// Points
pub use camera::{CAMERA_FAR, CAMERA_NEAR, Camera, OrthogonalDirection, Projection};
pub use point::{
    PointBatcher, PointInstance, aspect_from_matrix, point_clip_position, point_displacement,
    unit_circle_mesh,
};

// Passes and frames
pub use frame::{FrameRenderer, FrameStats, RendererConfig};
pub use frame_context::{FrameContext, text_projection};
pub use offscreen::{BufferDimensions, OffscreenConfig, OffscreenTarget};
pub use point_pass::{PointInstanceRaw, PointPass, PointVertex};
pub use text_pass::{
    GLYPH_FLAG_BOLD, GLYPH_FLAG_ITALIC, TextPass, TextUniforms, TextVertex, glyph_vertices,
};

// Re-export wgpu and glam for convenience
pub use glam;
pub use wgpu;
