use nalgebra::{Point3, Vector3};

use crate::tracer::scene::Triangle;

/// Axis-aligned box, the bounding volume used throughout the tree.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundsBox {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl BoundsBox {
    pub fn new(min: Point3<f32>, max: Point3<f32>) -> BoundsBox {
        BoundsBox { min, max }
    }

    // inverted infinities so the first expansion snaps exactly to the input
    pub fn empty() -> BoundsBox {
        BoundsBox {
            min: Point3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            max: Point3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }

    pub fn center(&self) -> Point3<f32> {
        Point3::from((self.min.coords + self.max.coords) * 0.5)
    }

    pub fn expand_with_point(&mut self, p: Point3<f32>) {
        self.min = self.min.inf(&p);
        self.max = self.max.sup(&p);
    }

    pub fn expand_with_bounds(&mut self, other: &BoundsBox) {
        self.expand_with_point(other.min);
        self.expand_with_point(other.max);
    }

    pub fn expand_with_triangle(&mut self, triangle: &Triangle) {
        self.expand_with_point(triangle.pos_a);
        self.expand_with_point(triangle.pos_b);
        self.expand_with_point(triangle.pos_c);
    }

    /// Componentwise inclusive containment; points exactly on a face count
    /// as inside.
    pub fn is_point_inside(&self, p: Point3<f32>) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// Splits along `axis` at `min + size * ratio`. The two halves share the
    /// split plane.
    pub fn split(&self, axis: usize, ratio: f32) -> (BoundsBox, BoundsBox) {
        let mid = self.min[axis] + (self.max[axis] - self.min[axis]) * ratio;
        let mut a = *self;
        let mut b = *self;
        a.max[axis] = mid;
        b.min[axis] = mid;
        (a, b)
    }

    /// Squared distance from the box surface to `p`; zero when `p` is inside.
    pub fn squared_dist_to_point(&self, p: Point3<f32>) -> f32 {
        let mut sq = 0.0;
        for axis in 0..3 {
            let v = p[axis];
            if v < self.min[axis] {
                let d = self.min[axis] - v;
                sq += d * d;
            }
            if v > self.max[axis] {
                let d = v - self.max[axis];
                sq += d * d;
            }
        }
        sq
    }
}
