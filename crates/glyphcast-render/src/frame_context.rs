//! Per-frame projection state.

use glam::Mat4;

use crate::types::{Color, Size};

/// Projection and color state written once per frame and read by every draw.
///
/// A `FrameContext` is a plain value: build one per frame (usually through
/// [`FrameRenderer::frame_context`](crate::FrameRenderer::frame_context))
/// and pass it to `render`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameContext {
    /// Viewport size in pixels.
    pub viewport: Size,
    /// Editor-space to clip-space projection for text.
    pub projection: Mat4,
    /// Color multiplied into every glyph.
    pub text_color: Color,
    /// Model-view-projection for point centers.
    pub point_mvp: Mat4,
    /// Color the target is cleared to.
    pub clear_color: Color,
}

impl FrameContext {
    /// Context for a viewport of `width` x `height` pixels.
    ///
    /// Points use the text projection until [`with_point_mvp`](Self::with_point_mvp)
    /// is called, so markers can be placed in editor space.
    pub fn for_viewport(width: u32, height: u32) -> Self {
        let projection = text_projection(width, height);
        Self {
            viewport: Size::new(width as f32, height as f32),
            projection,
            text_color: Color::WHITE,
            point_mvp: projection,
            clear_color: Color::BLACK,
        }
    }

    /// Use a separate camera for points.
    pub fn with_point_mvp(mut self, mvp: Mat4) -> Self {
        self.point_mvp = mvp;
        self
    }

    /// Set the global text color.
    pub fn with_text_color(mut self, color: Color) -> Self {
        self.text_color = color;
        self
    }

    /// Set the clear color.
    pub fn with_clear_color(mut self, color: Color) -> Self {
        self.clear_color = color;
        self
    }

    /// Check whether there is nothing to draw into.
    pub fn is_empty(&self) -> bool {
        self.viewport.is_empty()
    }
}

/// Orthographic projection from editor space (origin top-left, y down) to
/// clip space.
pub fn text_projection(width: u32, height: u32) -> Mat4 {
    Mat4::orthographic_rh(0.0, width as f32, height as f32, 0.0, -1.0, 1.0)
}
