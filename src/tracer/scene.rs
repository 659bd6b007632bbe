use nalgebra::{Point3, Vector3, Vector4};

use crate::camera::TracerCamera;
use crate::tracer::bvh::{self, aabb::BoundsBox, bake, build::BuildTree, FlatNode};
use crate::tracer::error::SceneError;
use crate::tracer::settings::TracerSettings;
use crate::tracer::trace::{HitInfo, Ray};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LightKind {
    Spot,
    Directional,
    Point,
}

impl LightKind {
    // wire discriminants of the binary scene format
    pub fn from_wire(value: i32) -> Option<LightKind> {
        match value {
            0 => Some(LightKind::Spot),
            1 => Some(LightKind::Directional),
            2 => Some(LightKind::Point),
            _ => None,
        }
    }

    pub fn to_wire(self) -> i32 {
        match self {
            LightKind::Spot => 0,
            LightKind::Directional => 1,
            LightKind::Point => 2,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    pub color: Vector4<f32>,
    pub roughness: f32,
    /// Emissive materials act as light sources via direct hits only; they are
    /// never part of the light list.
    pub is_emissive: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Light {
    pub color: Vector4<f32>,
    pub position: Point3<f32>,
    pub forward: Vector3<f32>,
    pub range: f32,
    pub intensity: f32,
    // full cone angle in degrees, spot lights only
    pub angle: f32,
    pub kind: LightKind,
}

/// One triangle of the scene mesh. The fields after `material_index` are
/// derived by [`Triangle::compute`] and cached so the hot intersection path
/// never recomputes them; `node_index` is assigned while baking.
#[derive(Clone, Debug, PartialEq)]
pub struct Triangle {
    pub pos_a: Point3<f32>,
    pub pos_b: Point3<f32>,
    pub pos_c: Point3<f32>,
    pub normal_a: Vector3<f32>,
    pub normal_b: Vector3<f32>,
    pub normal_c: Vector3<f32>,
    pub material_index: u32,

    pub centroid: Point3<f32>,
    pub edge_ab: Vector3<f32>,
    pub edge_ac: Vector3<f32>,
    // average of the vertex normals, deliberately not renormalized
    pub face_normal: Vector3<f32>,
    pub bounds: BoundsBox,
    pub node_index: u32,
}

impl Triangle {
    pub fn new(
        positions: [Point3<f32>; 3],
        normals: [Vector3<f32>; 3],
        material_index: u32,
    ) -> Triangle {
        let mut triangle = Triangle {
            pos_a: positions[0],
            pos_b: positions[1],
            pos_c: positions[2],
            normal_a: normals[0],
            normal_b: normals[1],
            normal_c: normals[2],
            material_index,
            centroid: Point3::origin(),
            edge_ab: Vector3::zeros(),
            edge_ac: Vector3::zeros(),
            face_normal: Vector3::zeros(),
            bounds: BoundsBox::empty(),
            node_index: 0,
        };
        triangle.compute();
        triangle
    }

    pub fn compute(&mut self) {
        self.centroid = Point3::from(
            (self.pos_a.coords + self.pos_b.coords + self.pos_c.coords) / 3.0,
        );
        self.face_normal = (self.normal_a + self.normal_b + self.normal_c) / 3.0;
        self.edge_ab = self.pos_b - self.pos_a;
        self.edge_ac = self.pos_c - self.pos_a;
        let mut bounds = BoundsBox::empty();
        bounds.expand_with_triangle(self);
        self.bounds = bounds;
    }
}

/// A decoded scene exactly as it came off the wire, before any acceleration
/// structure exists.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneFile {
    pub bounds: BoundsBox,
    pub camera: TracerCamera,
    pub materials: Vec<Material>,
    pub triangles: Vec<Triangle>,
    pub lights: Vec<Light>,
}

/// The baked scene: triangles reordered for leaf locality, the flat BVH node
/// array (node 0 is the root), and per-leaf light relevance already computed.
/// Immutable for the whole render; workers share it behind an `Arc` without
/// locking.
#[derive(Clone, Debug)]
pub struct Scene {
    pub bounds: BoundsBox,
    pub camera: TracerCamera,
    pub materials: Vec<Material>,
    pub triangles: Vec<Triangle>,
    pub lights: Vec<Light>,
    pub nodes: Vec<FlatNode>,
}

impl Scene {
    /// Builds the partition tree, tightens it, and flattens it into the
    /// index-addressed form. Runs to completion before any ray is traced.
    pub fn bake(file: SceneFile, settings: &TracerSettings) -> Result<Scene, SceneError> {
        let SceneFile {
            bounds,
            camera,
            materials,
            triangles,
            lights,
        } = file;

        for (i, triangle) in triangles.iter().enumerate() {
            if triangle.material_index as usize >= materials.len() {
                return Err(SceneError::MaterialIndexOutOfRange {
                    triangle: i,
                    index: triangle.material_index,
                    count: materials.len(),
                });
            }
        }

        let mut tree = BuildTree::new(
            bounds,
            settings.bvh_triangles_per_leaf,
            settings.bvh_max_depth,
        );
        for i in 0..triangles.len() {
            tree.insert(i, &triangles);
        }
        tree.finish_generation(&triangles);

        let (nodes, triangles) = bake::flatten(&tree, triangles, &lights);

        Ok(Scene {
            bounds,
            camera,
            materials,
            triangles,
            lights,
            nodes,
        })
    }

    /// Globally nearest hit within `max_distance`, if any.
    pub fn nearest_hit(&self, ray: &Ray, max_distance: f32) -> Option<HitInfo> {
        if self.nodes.is_empty() {
            return None;
        }
        bvh::nearest_hit(self, ray, max_distance, 0)
    }

    /// True as soon as anything occludes the ray within `max_distance`.
    pub fn any_hit(&self, ray: &Ray, max_distance: f32) -> bool {
        if self.nodes.is_empty() {
            return false;
        }
        bvh::any_hit(self, ray, max_distance, 0)
    }
}
