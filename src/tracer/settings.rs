use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiffuseMode {
    Lambert,
    OrenNayar,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpecularMode {
    BlinnPhong,
    CookTorrance,
}

/// Render configuration consumed from the outside; every field has a default
/// so a settings file only needs to name what it overrides.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TracerSettings {
    pub width: u32,
    pub height: u32,
    pub max_iterations: u32,
    pub indirect_bounces: u32,
    pub indirect_power: f32,
    pub bvh_max_depth: u32,
    pub bvh_triangles_per_leaf: usize,
    pub diffuse_mode: DiffuseMode,
    pub specular_mode: SpecularMode,
}

impl Default for TracerSettings {
    fn default() -> TracerSettings {
        TracerSettings {
            width: 300,
            height: 200,
            max_iterations: 16,
            indirect_bounces: 2,
            indirect_power: 1.0,
            bvh_max_depth: 16,
            bvh_triangles_per_leaf: 32,
            diffuse_mode: DiffuseMode::Lambert,
            specular_mode: SpecularMode::BlinnPhong,
        }
    }
}
