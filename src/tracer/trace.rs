use nalgebra::{Point3, Vector3};

use crate::tracer::bvh::aabb::BoundsBox;
use crate::tracer::scene::Triangle;

// reported hit positions are pulled back along the ray by this much so a
// follow-up ray never re-intersects the surface it started on
pub const HIT_BIAS: f32 = 1e-4;

/// Direction does not have to be unit length for traversal, but the shading
/// math assumes it is; camera and bounce rays are always normalized.
#[derive(Clone, Copy, Debug)]
pub struct Ray {
    pub origin: Point3<f32>,
    pub direction: Vector3<f32>,
}

#[derive(Clone, Copy, Debug)]
pub struct HitInfo {
    pub distance: f32,
    pub position: Point3<f32>,
    pub normal: Vector3<f32>,
    pub incoming: Vector3<f32>,
    pub material_index: u32,
    pub node_index: u32,
}

/// Three-axis slab test. Zero direction components divide to ±inf, which the
/// comparisons handle without special cases.
pub fn ray_hits_bounds(ray: &Ray, bounds: &BoundsBox) -> bool {
    let mut tmin = (bounds.min.x - ray.origin.x) / ray.direction.x;
    let mut tmax = (bounds.max.x - ray.origin.x) / ray.direction.x;
    if tmin > tmax {
        (tmin, tmax) = (tmax, tmin);
    }

    let mut tymin = (bounds.min.y - ray.origin.y) / ray.direction.y;
    let mut tymax = (bounds.max.y - ray.origin.y) / ray.direction.y;
    if tymin > tymax {
        (tymin, tymax) = (tymax, tymin);
    }

    if tmin > tymax || tymin > tmax {
        return false;
    }
    if tymin > tmin {
        tmin = tymin;
    }
    if tymax < tmax {
        tmax = tymax;
    }

    let mut tzmin = (bounds.min.z - ray.origin.z) / ray.direction.z;
    let mut tzmax = (bounds.max.z - ray.origin.z) / ray.direction.z;
    if tzmin > tzmax {
        (tzmin, tzmax) = (tzmax, tzmin);
    }

    !(tmin > tzmax || tzmin > tmax)
}

/// Möller–Trumbore with back-face culling. Accepts distances in
/// `(0, max_distance]` only; near-parallel rays (determinant under the
/// smallest normal float) are treated as misses rather than divided through.
pub fn intersect_triangle(triangle: &Triangle, ray: &Ray, max_distance: f32) -> Option<HitInfo> {
    if ray.direction.dot(&triangle.face_normal) >= 0.0 {
        return None;
    }

    let p_vec = ray.direction.cross(&triangle.edge_ac);
    let det = triangle.edge_ab.dot(&p_vec);
    if det.abs() < f32::MIN_POSITIVE {
        return None;
    }
    let inv_det = 1.0 / det;

    let t_vec = ray.origin - triangle.pos_a;
    let u = t_vec.dot(&p_vec) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q_vec = t_vec.cross(&triangle.edge_ab);
    let v = ray.direction.dot(&q_vec) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let distance = triangle.edge_ac.dot(&q_vec) * inv_det;
    if distance <= 0.0 || distance > max_distance {
        return None;
    }

    let normal = (triangle.normal_a * (1.0 - u - v)
        + triangle.normal_b * u
        + triangle.normal_c * v)
        .normalize();

    Some(HitInfo {
        distance,
        position: ray.origin + ray.direction * (distance - HIT_BIAS),
        normal,
        incoming: ray.direction,
        material_index: triangle.material_index,
        node_index: triangle.node_index,
    })
}

/// Same rejection logic as [`intersect_triangle`] without assembling hit
/// data; shadow queries short-circuit on the first acceptance.
pub fn intersect_triangle_fast(triangle: &Triangle, ray: &Ray, max_distance: f32) -> bool {
    if ray.direction.dot(&triangle.face_normal) >= 0.0 {
        return false;
    }

    let p_vec = ray.direction.cross(&triangle.edge_ac);
    let det = triangle.edge_ab.dot(&p_vec);
    if det.abs() < f32::MIN_POSITIVE {
        return false;
    }
    let inv_det = 1.0 / det;

    let t_vec = ray.origin - triangle.pos_a;
    let u = t_vec.dot(&p_vec) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return false;
    }

    let q_vec = t_vec.cross(&triangle.edge_ab);
    let v = ray.direction.dot(&q_vec) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return false;
    }

    let distance = triangle.edge_ac.dot(&q_vec) * inv_det;
    distance > 0.0 && distance <= max_distance
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Vector3};

    use super::{intersect_triangle, intersect_triangle_fast, ray_hits_bounds, Ray};
    use crate::tracer::bvh::aabb::BoundsBox;
    use crate::tracer::scene::Triangle;

    fn floor_triangle() -> Triangle {
        // counter-clockwise in the xz plane, normals up
        let up = Vector3::new(0.0, 1.0, 0.0);
        Triangle::new(
            [
                Point3::new(-1.0, 0.0, -1.0),
                Point3::new(1.0, 0.0, -1.0),
                Point3::new(0.0, 0.0, 1.0),
            ],
            [up, up, up],
            0,
        )
    }

    #[test]
    fn ray_from_inside_the_box_always_hits() {
        let bounds = BoundsBox::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0));
        for direction in [
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, -1.0, 0.0),
            Vector3::new(-0.3, 0.5, 0.8).normalize(),
        ] {
            let ray = Ray {
                origin: Point3::new(0.2, -0.1, 0.4),
                direction,
            };
            assert!(ray_hits_bounds(&ray, &bounds));
        }
    }

    #[test]
    fn parallel_ray_outside_the_slab_misses_without_crashing() {
        let bounds = BoundsBox::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0));
        // parallel to the y slabs, offset above the box
        let ray = Ray {
            origin: Point3::new(-5.0, 2.0, 0.0),
            direction: Vector3::new(1.0, 0.0, 0.0),
        };
        assert!(!ray_hits_bounds(&ray, &bounds));

        // same ray shifted to pass through the box
        let ray = Ray {
            origin: Point3::new(-5.0, 0.5, 0.0),
            direction: Vector3::new(1.0, 0.0, 0.0),
        };
        assert!(ray_hits_bounds(&ray, &bounds));
    }

    #[test]
    fn front_face_centroid_ray_hits() {
        let triangle = floor_triangle();
        let ray = Ray {
            origin: Point3::new(triangle.centroid.x, 2.0, triangle.centroid.z),
            direction: Vector3::new(0.0, -1.0, 0.0),
        };
        let hit = intersect_triangle(&triangle, &ray, f32::INFINITY).unwrap();
        assert_relative_eq!(hit.distance, 2.0, epsilon = 1e-5);
        assert_relative_eq!(hit.normal.y, 1.0, epsilon = 1e-6);
        // position is biased back toward the origin
        assert!(hit.position.y > 0.0);
        assert!(intersect_triangle_fast(&triangle, &ray, f32::INFINITY));
    }

    #[test]
    fn back_face_is_culled() {
        let triangle = floor_triangle();
        let ray = Ray {
            origin: Point3::new(triangle.centroid.x, -2.0, triangle.centroid.z),
            direction: Vector3::new(0.0, 1.0, 0.0),
        };
        assert!(intersect_triangle(&triangle, &ray, f32::INFINITY).is_none());
        assert!(!intersect_triangle_fast(&triangle, &ray, f32::INFINITY));
    }

    #[test]
    fn hit_beyond_max_distance_is_rejected() {
        let triangle = floor_triangle();
        let ray = Ray {
            origin: Point3::new(triangle.centroid.x, 2.0, triangle.centroid.z),
            direction: Vector3::new(0.0, -1.0, 0.0),
        };
        assert!(intersect_triangle(&triangle, &ray, 1.5).is_none());
        assert!(intersect_triangle(&triangle, &ray, 2.5).is_some());
    }

    #[test]
    fn degenerate_triangle_never_hits() {
        // all three vertices colinear, face normal still pointing up
        let up = Vector3::new(0.0, 1.0, 0.0);
        let degenerate = Triangle::new(
            [
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(2.0, 0.0, 0.0),
            ],
            [up, up, up],
            0,
        );
        let ray = Ray {
            origin: Point3::new(1.0, 1.0, 0.0),
            direction: Vector3::new(0.0, -1.0, 0.0),
        };
        assert!(intersect_triangle(&degenerate, &ray, f32::INFINITY).is_none());
    }
}
