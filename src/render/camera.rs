//! Pinhole camera in unit-cube coordinates.

use glam::{Mat3, Quat, Vec3};

use crate::field::PoseMatrix;

/// A ray with the clip range derived from the near and far planes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit direction.
    pub dir: Vec3,
    pub t_min: f32,
    pub t_max: f32,
}

/// Perspective camera looking down its local `-Z`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    /// Camera-to-world rotation.
    pub rotation: Quat,
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::look_at(Vec3::new(0.5, 0.5, 2.0), Vec3::splat(0.5), Vec3::Y)
    }
}

impl Camera {
    pub fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Self {
        // look_at_rh builds world-to-view; invert for camera-to-world.
        let view = glam::Mat4::look_at_rh(eye, target, up);
        let rotation = Quat::from_mat4(&view.inverse()).normalize();
        Self {
            position: eye,
            rotation,
            fov: 45.0,
            near: 0.01,
            far: 20.0,
        }
    }

    /// Seed from an asset pose.
    ///
    /// Poses use a y-down, z-forward camera; the second and third rotation
    /// columns are flipped. The translation is mapped from scene units into
    /// the unit cube the renderer marches (`aabb_scale = 2^(M-1)`).
    pub fn from_pose(pose: &PoseMatrix, aabb_scale: f32) -> Self {
        let col = |j: usize| Vec3::new(pose[0][j], pose[1][j], pose[2][j]);
        let basis = Mat3::from_cols(
            col(0).normalize_or_zero(),
            -col(1).normalize_or_zero(),
            -col(2).normalize_or_zero(),
        );
        let position = (col(3) - 0.5) / aabb_scale + 0.5;
        Self {
            position,
            rotation: Quat::from_mat3(&basis).normalize(),
            ..Self::default()
        }
    }

    /// Same position, view direction and lens, rolled so `up` points up.
    /// Unchanged when `up` is parallel to the view direction.
    pub fn reoriented(&self, up: Vec3) -> Self {
        let forward = self.forward();
        if forward.cross(up).length_squared() < 1e-12 {
            return *self;
        }
        Self {
            fov: self.fov,
            near: self.near,
            far: self.far,
            ..Self::look_at(self.position, self.position + forward, up)
        }
    }

    /// Unit view direction.
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    /// Ray through the center of pixel `(x, y)`; row 0 is the top.
    pub fn ray(&self, x: usize, y: usize, width: usize, height: usize) -> Ray {
        let half_h = (self.fov.to_radians() * 0.5).tan();
        let half_w = half_h * width as f32 / height.max(1) as f32;
        let sx = (2.0 * (x as f32 + 0.5) / width as f32 - 1.0) * half_w;
        let sy = (1.0 - 2.0 * (y as f32 + 0.5) / height as f32) * half_h;
        let local = Vec3::new(sx, sy, -1.0);
        // Near/far are view-space depths; convert to distances along the ray.
        let stretch = local.length();
        Ray {
            origin: self.position,
            dir: self.rotation * (local / stretch),
            t_min: self.near * stretch,
            t_max: self.far * stretch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).abs().max_element() < 1e-5
    }

    #[test]
    fn test_look_at_forward() {
        let cam = Camera::look_at(Vec3::new(0.5, 0.5, 3.0), Vec3::splat(0.5), Vec3::Y);
        assert!(approx(cam.forward(), Vec3::NEG_Z));
        let center = cam.ray(50, 50, 101, 101);
        assert!(approx(center.dir, Vec3::NEG_Z));
        assert!((center.t_min - cam.near).abs() < 1e-6);
    }

    #[test]
    fn test_pixel_orientation() {
        let cam = Camera::default();
        let top_left = cam.ray(0, 0, 64, 48);
        assert!(top_left.dir.x < 0.0 && top_left.dir.y > 0.0);
        let bottom_right = cam.ray(63, 47, 64, 48);
        assert!(bottom_right.dir.x > 0.0 && bottom_right.dir.y < 0.0);
        assert!((top_left.dir.length() - 1.0).abs() < 1e-5);
        assert!(top_left.t_max > cam.far);
    }

    #[test]
    fn test_from_pose_flips_axes_and_rescales() {
        // Identity rotation in the y-down, z-forward convention.
        let pose: PoseMatrix = [
            [1.0, 0.0, 0.0, 0.5],
            [0.0, 1.0, 0.0, 0.5],
            [0.0, 0.0, 1.0, 4.5],
        ];
        let cam = Camera::from_pose(&pose, 2.0);
        assert!(approx(cam.position, Vec3::new(0.5, 0.5, 2.5)));
        // Local -Z maps to world +Z after the flip.
        assert!(approx(cam.forward(), Vec3::Z));
        assert!(approx(cam.rotation * Vec3::Y, Vec3::NEG_Y));
    }

    #[test]
    fn test_reoriented_rolls_about_view_axis() {
        let cam = Camera {
            fov: 30.0,
            ..Camera::default()
        };
        let rolled = cam.reoriented(Vec3::X);
        assert!(approx(rolled.forward(), cam.forward()));
        assert!(approx(rolled.rotation * Vec3::Y, Vec3::X));
        assert_eq!(rolled.position, cam.position);
        assert_eq!(rolled.fov, 30.0);
        // Up along the view axis has no roll to pick.
        assert_eq!(cam.reoriented(Vec3::Z), cam);
    }
}
