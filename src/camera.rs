use nalgebra::{Point3, Vector3};

use crate::tracer::trace::Ray;

#[inline]
fn deg2rad(deg: f32) -> f32 {
    deg * std::f32::consts::PI / 180.0
}

/// Camera basis exported by the scene tooling. The vectors arrive world-space
/// and orthonormal; no transform happens on this side.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TracerCamera {
    pub position: Point3<f32>,
    pub forward: Vector3<f32>,
    pub right: Vector3<f32>,
    pub up: Vector3<f32>,
    // world-space extent for orthographic cameras, which export fov = 0
    pub horizontal_size: f32,
    // vertical field of view in degrees
    pub fov: f32,
}

impl TracerCamera {
    // ray through the center of pixel (x, y); (0, 0) is the bottom-left corner
    pub fn primary_ray(&self, x: u32, y: u32, width: u32, height: u32) -> Ray {
        let aspect = width as f32 / height as f32;
        let u = ((x as f32 + 0.5) / width as f32) * 2.0 - 1.0;
        let v = ((y as f32 + 0.5) / height as f32) * 2.0 - 1.0;

        if self.fov > 0.0 {
            let half_height = (deg2rad(self.fov) * 0.5).tan();
            let direction = self.forward
                + self.right * (u * half_height * aspect)
                + self.up * (v * half_height);
            Ray {
                origin: self.position,
                direction: direction.normalize(),
            }
        } else {
            let half_width = self.horizontal_size * 0.5;
            let origin = self.position
                + self.right * (u * half_width)
                + self.up * (v * half_width / aspect);
            Ray {
                origin,
                direction: self.forward,
            }
        }
    }
}
