//! Point markers drawn as instanced, aspect-corrected discs.
//!
//! Every point shares one unit-circle mesh. The vertex stage projects the
//! instance center and then displaces each mesh vertex in clip space:
//!
//! ```text
//! clip    = mvp * vec4(center, 1)
//! aspect  = |mvp[1][1] / mvp[0][0]|
//! d       = (vertex.xy + offset) * size
//! d.x     = d.x / aspect
//! clip.xy += d * clip.w
//! ```
//!
//! The aspect ratio comes from the matrix alone, so discs stay round for any
//! viewport without a viewport uniform. The functions here mirror the shader
//! so the math can be checked on the CPU.

use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::types::Color;

/// One point marker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointInstance {
    /// Center in world space (transformed by the point MVP).
    pub center: Vec3,
    /// Radius scale in normalized device units.
    pub size: f32,
    /// Displacement added to every mesh vertex before scaling.
    pub offset: Vec2,
    /// Fill color.
    pub color: Color,
}

/// Accumulates point instances for one frame.
#[derive(Debug, Clone, Default)]
pub struct PointBatcher {
    instances: Vec<PointInstance>,
}

impl PointBatcher {
    /// Create an empty batcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a batcher with room for `capacity` points.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            instances: Vec::with_capacity(capacity),
        }
    }

    /// Add a white point.
    pub fn emit(&mut self, center: Vec3, size: f32, offset: Vec2) {
        self.emit_colored(center, size, offset, Color::WHITE);
    }

    /// Add a point with a color.
    pub fn emit_colored(&mut self, center: Vec3, size: f32, offset: Vec2, color: Color) {
        self.instances.push(PointInstance {
            center,
            size,
            offset,
            color,
        });
    }

    /// Points added since the last clear.
    pub fn instances(&self) -> &[PointInstance] {
        &self.instances
    }

    /// Remove all points, keeping the allocation.
    pub fn clear(&mut self) {
        self.instances.clear();
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

/// Triangle-list unit circle in the z = 0 plane, `segments` triangles
/// fanned around the origin (at least 3).
pub fn unit_circle_mesh(segments: u32) -> Vec<[f32; 3]> {
    let segments = segments.max(3);
    let step = std::f32::consts::TAU / segments as f32;
    let rim = |i: u32| {
        let angle = (i % segments) as f32 * step;
        [angle.cos(), angle.sin(), 0.0]
    };

    let mut vertices = Vec::with_capacity(segments as usize * 3);
    for i in 0..segments {
        vertices.push([0.0, 0.0, 0.0]);
        vertices.push(rim(i));
        vertices.push(rim(i + 1));
    }
    vertices
}

/// Aspect ratio encoded in a projection: `|mvp[1][1] / mvp[0][0]|`.
///
/// Degenerate matrices give 1.0.
pub fn aspect_from_matrix(mvp: &Mat4) -> f32 {
    let m00 = mvp.x_axis.x;
    let m11 = mvp.y_axis.y;
    if m00 == 0.0 || m11 == 0.0 {
        1.0
    } else {
        (m11 / m00).abs()
    }
}

/// Clip-space displacement of one mesh vertex, before the `clip.w` scale.
pub fn point_displacement(mvp: &Mat4, vertex: Vec2, offset: Vec2, size: f32) -> Vec2 {
    let mut d = (vertex + offset) * size;
    d.x /= aspect_from_matrix(mvp);
    d
}

/// Final clip position of one mesh vertex of a point.
pub fn point_clip_position(
    mvp: &Mat4,
    center: Vec3,
    vertex: Vec2,
    offset: Vec2,
    size: f32,
) -> Vec4 {
    let clip = *mvp * center.extend(1.0);
    let d = point_displacement(mvp, vertex, offset, size) * clip.w;
    Vec4::new(clip.x + d.x, clip.y + d.y, clip.z, clip.w)
}
