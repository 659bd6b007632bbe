pub mod aabb;
pub mod bake;
pub mod build;

use crate::tracer::bvh::aabb::BoundsBox;
use crate::tracer::scene::Scene;
use crate::tracer::trace::{self, HitInfo, Ray};

/// Child slot of a leaf node.
pub const NO_CHILD: u32 = u32::MAX;

/// One node of the baked hierarchy. Leaves own the triangle range
/// `start..start + count` in the scene's reordered triangle array and carry
/// the indices of every light that can affect those triangles.
#[derive(Clone, Debug)]
pub struct FlatNode {
    pub bounds: BoundsBox,
    pub depth: u32,
    pub is_leaf: bool,
    pub child_a: u32,
    pub child_b: u32,
    pub start: u32,
    pub count: u32,
    pub light_indices: Vec<u32>,
}

/// Nearest hit under `node_idx` within `max_distance`. Both children of an
/// internal node are visited with the caller's limit; only leaf scans shrink
/// it, so sibling order never changes the result.
pub fn nearest_hit(scene: &Scene, ray: &Ray, max_distance: f32, node_idx: usize) -> Option<HitInfo> {
    let node = &scene.nodes[node_idx];

    if node.is_leaf && node.count == 0 {
        return None;
    }
    if !trace::ray_hits_bounds(ray, &node.bounds) {
        return None;
    }

    if node.is_leaf {
        let mut closest: Option<HitInfo> = None;
        let mut limit = max_distance;
        for t in node.start..node.start + node.count {
            if let Some(hit) = trace::intersect_triangle(&scene.triangles[t as usize], ray, limit) {
                limit = hit.distance;
                closest = Some(hit);
            }
        }
        closest
    } else {
        let hit_a = nearest_hit(scene, ray, max_distance, node.child_a as usize);
        let hit_b = nearest_hit(scene, ray, max_distance, node.child_b as usize);
        match (hit_a, hit_b) {
            (Some(a), Some(b)) => Some(if a.distance <= b.distance { a } else { b }),
            (a, b) => a.or(b),
        }
    }
}

/// True as soon as any triangle under `node_idx` blocks the ray.
pub fn any_hit(scene: &Scene, ray: &Ray, max_distance: f32, node_idx: usize) -> bool {
    let node = &scene.nodes[node_idx];

    if node.is_leaf && node.count == 0 {
        return false;
    }
    if !trace::ray_hits_bounds(ray, &node.bounds) {
        return false;
    }

    if node.is_leaf {
        (node.start..node.start + node.count)
            .any(|t| trace::intersect_triangle_fast(&scene.triangles[t as usize], ray, max_distance))
    } else {
        any_hit(scene, ray, max_distance, node.child_a as usize)
            || any_hit(scene, ray, max_distance, node.child_b as usize)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Vector3, Vector4};
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    use crate::camera::TracerCamera;
    use crate::tracer::bvh::aabb::BoundsBox;
    use crate::tracer::scene::{Material, Scene, SceneFile, Triangle};
    use crate::tracer::settings::TracerSettings;
    use crate::tracer::trace::{self, HitInfo, Ray};

    fn test_camera() -> TracerCamera {
        TracerCamera {
            position: Point3::new(0.0, 0.0, 0.0),
            forward: Vector3::new(0.0, 0.0, -1.0),
            right: Vector3::new(1.0, 0.0, 0.0),
            up: Vector3::new(0.0, 1.0, 0.0),
            horizontal_size: 1.0,
            fov: 60.0,
        }
    }

    fn random_scene(seed: u64, count: usize) -> Scene {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut triangles = Vec::with_capacity(count);
        let mut bounds = BoundsBox::empty();
        for _ in 0..count {
            let center = Point3::new(
                rng.gen_range(-10.0f32..10.0),
                rng.gen_range(-10.0f32..10.0),
                rng.gen_range(-10.0f32..10.0),
            );
            let offset = |rng: &mut SmallRng| {
                Vector3::new(
                    rng.gen_range(-0.5f32..0.5),
                    rng.gen_range(-0.5f32..0.5),
                    rng.gen_range(-0.5f32..0.5),
                )
            };
            let a = center + offset(&mut rng);
            let b = center + offset(&mut rng);
            let c = center + offset(&mut rng);
            let normal = (b - a).cross(&(c - a));
            if normal.norm_squared() < 1e-8 {
                continue;
            }
            let normal = normal.normalize();
            let triangle = Triangle::new([a, b, c], [normal, normal, normal], 0);
            bounds.expand_with_triangle(&triangle);
            triangles.push(triangle);
        }

        let file = SceneFile {
            bounds,
            camera: test_camera(),
            materials: vec![Material {
                color: Vector4::new(1.0, 1.0, 1.0, 1.0),
                roughness: 0.5,
                is_emissive: false,
            }],
            triangles,
            lights: vec![],
        };
        let settings = TracerSettings {
            bvh_max_depth: 8,
            bvh_triangles_per_leaf: 4,
            ..TracerSettings::default()
        };
        Scene::bake(file, &settings).unwrap()
    }

    fn brute_force_nearest(scene: &Scene, ray: &Ray, max_distance: f32) -> Option<HitInfo> {
        let mut closest: Option<HitInfo> = None;
        let mut limit = max_distance;
        for triangle in &scene.triangles {
            if let Some(hit) = trace::intersect_triangle(triangle, ray, limit) {
                limit = hit.distance;
                closest = Some(hit);
            }
        }
        closest
    }

    fn random_ray(rng: &mut SmallRng) -> Ray {
        Ray {
            origin: Point3::new(
                rng.gen_range(-12.0f32..12.0),
                rng.gen_range(-12.0f32..12.0),
                rng.gen_range(-12.0f32..12.0),
            ),
            direction: Vector3::new(
                rng.gen_range(-1.0f32..1.0),
                rng.gen_range(-1.0f32..1.0),
                rng.gen_range(-1.0f32..1.0),
            )
            .normalize(),
        }
    }

    #[test]
    fn traversal_matches_brute_force() {
        for seed in 0..4u64 {
            let scene = random_scene(seed, 300);
            let mut rng = SmallRng::seed_from_u64(seed ^ 0xdead);
            for _ in 0..200 {
                let ray = random_ray(&mut rng);
                let reference = brute_force_nearest(&scene, &ray, f32::INFINITY);
                let found = scene.nearest_hit(&ray, f32::INFINITY);
                match (reference, found) {
                    (Some(a), Some(b)) => {
                        assert_relative_eq!(a.distance, b.distance, epsilon = 1e-4)
                    }
                    (None, None) => {}
                    (a, b) => panic!("hierarchy {:?} disagrees with scan {:?}", b, a),
                }
            }
        }
    }

    #[test]
    fn any_hit_agrees_with_nearest_hit() {
        let scene = random_scene(7, 300);
        let mut rng = SmallRng::seed_from_u64(99);
        for _ in 0..200 {
            let ray = random_ray(&mut rng);
            for limit in [2.0f32, 10.0, f32::INFINITY] {
                assert_eq!(
                    scene.any_hit(&ray, limit),
                    scene.nearest_hit(&ray, limit).is_some()
                );
            }
        }
    }

    #[test]
    fn empty_scene_never_hits() {
        let file = SceneFile {
            bounds: BoundsBox::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0)),
            camera: test_camera(),
            materials: vec![],
            triangles: vec![],
            lights: vec![],
        };
        let scene = Scene::bake(file, &TracerSettings::default()).unwrap();
        let ray = Ray {
            origin: Point3::new(0.0, 0.0, 5.0),
            direction: Vector3::new(0.0, 0.0, -1.0),
        };
        assert!(scene.nearest_hit(&ray, f32::INFINITY).is_none());
        assert!(!scene.any_hit(&ray, f32::INFINITY));
    }
}
