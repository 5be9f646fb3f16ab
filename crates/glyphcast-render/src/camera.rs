//! Orbit camera for point markers placed in world space.
//!
//! The camera orbits a target point at a distance. Angles are in degrees.
//! Projections use wgpu's 0..1 depth range, so no clip-space correction is
//! needed before the matrix reaches the point shader.

use glam::{Mat4, Vec3};

/// Near clip plane distance.
pub const CAMERA_NEAR: f32 = 0.1;
/// Far clip plane distance.
pub const CAMERA_FAR: f32 = 1000.0;

/// Projection used by a [`Camera`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    Perspective,
    /// Parallel projection sized so the target plane matches what the
    /// perspective projection would show at the current distance.
    Orthographic,
}

/// Axis-aligned views for [`Camera::orthogonal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrthogonalDirection {
    Front,
    Right,
    Top,
}

/// Orbit camera.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Point the camera orbits and looks at.
    pub target: Vec3,
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
    /// Distance from the target along the view axis.
    pub distance: f32,
    /// Vertical field of view in degrees.
    pub fov_y: f32,
    pub projection: Projection,
    pub min_distance: f32,
    pub max_distance: f32,
    aspect_ratio: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            target: Vec3::new(0.0, 1.0, 4.0),
            pitch: 0.0,
            yaw: 0.0,
            roll: 0.0,
            distance: 5.0,
            fov_y: 45.0,
            projection: Projection::Perspective,
            min_distance: 5.0,
            max_distance: 1500.0,
            aspect_ratio: 1.0,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target point.
    pub fn with_target(mut self, target: Vec3) -> Self {
        self.target = target;
        self
    }

    /// Set the distance, clamped to the distance limits.
    pub fn with_distance(mut self, distance: f32) -> Self {
        self.distance = distance.clamp(self.min_distance, self.max_distance);
        self
    }

    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    /// Width over height of the viewport.
    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    /// Update the aspect ratio from a viewport size.
    ///
    /// An empty viewport gives 1.0 so the projection stays finite.
    pub fn set_aspect_ratio(&mut self, width: u32, height: u32) {
        self.aspect_ratio = if width == 0 || height == 0 {
            1.0
        } else {
            width as f32 / height as f32
        };
    }

    /// Rotation applied after moving the target to the origin.
    pub fn rotation(&self) -> Mat4 {
        Mat4::from_rotation_x(self.pitch.to_radians())
            * Mat4::from_rotation_y(self.yaw.to_radians())
            * Mat4::from_rotation_z(self.roll.to_radians())
    }

    /// World to view transform.
    pub fn view(&self) -> Mat4 {
        Mat4::from_translation(Vec3::new(0.0, 0.0, -self.distance))
            * self.rotation()
            * Mat4::from_translation(-self.target)
    }

    /// View to clip transform for the current aspect ratio.
    pub fn projection_matrix(&self) -> Mat4 {
        match self.projection {
            Projection::Perspective => Mat4::perspective_rh(
                self.fov_y.to_radians(),
                self.aspect_ratio,
                CAMERA_NEAR,
                CAMERA_FAR,
            ),
            Projection::Orthographic => {
                let half = (self.fov_y.to_radians() / 2.0).tan() * self.distance.abs();
                // The shorter side spans the full half-extent.
                let (half_w, half_h) = if self.aspect_ratio >= 1.0 {
                    (half * self.aspect_ratio, half)
                } else {
                    (half, half / self.aspect_ratio)
                };
                Mat4::orthographic_rh(-half_w, half_w, -half_h, half_h, CAMERA_NEAR, CAMERA_FAR)
            }
        }
    }

    /// Combined world to clip transform, usable as a point MVP.
    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view()
    }

    /// Move toward or away from the target, within the distance limits.
    pub fn dolly(&mut self, amount: f32) {
        self.distance = (self.distance + amount).clamp(self.min_distance, self.max_distance);
    }

    /// Orbit around the target by a pointer delta in pixels.
    ///
    /// Orbiting always switches back to a perspective projection.
    pub fn orbit(&mut self, dx: f32, dy: f32) {
        self.projection = Projection::Perspective;
        self.yaw -= dx * 0.5;
        self.pitch = (self.pitch - dy * 0.5).clamp(-89.0, 89.0);
    }

    /// Move the target in screen space, scaled by the distance.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        let speed = 0.01 * self.distance;
        let screen = Vec3::new(-dx * speed, dy * speed, 0.0);
        self.target += self.rotation().inverse().transform_vector3(screen);
    }

    /// Look along an axis with a parallel projection.
    pub fn orthogonal(&mut self, direction: OrthogonalDirection, opposite: bool) {
        self.projection = Projection::Orthographic;
        self.pitch = 0.0;
        self.yaw = 0.0;
        self.roll = 0.0;
        match direction {
            OrthogonalDirection::Front => self.yaw = if opposite { 180.0 } else { 0.0 },
            OrthogonalDirection::Right => self.yaw = if opposite { -90.0 } else { 90.0 },
            OrthogonalDirection::Top => self.pitch = if opposite { 90.0 } else { -90.0 },
        }
    }

    /// Orbit around `point` from now on, keeping the distance.
    pub fn focus(&mut self, point: Vec3) {
        self.target = point;
    }
}
