use nalgebra::Vector3;

use crate::tracer::settings::{DiffuseMode, SpecularMode};

const GEOMETRY_EPS: f32 = 1e-4;

/// Shading geometry for one light sample: all vectors unit length, `l` toward
/// the light, `v` toward the viewer, `n` the shading normal.
#[derive(Clone, Copy, Debug)]
pub struct BrdfInputs {
    pub roughness: f32,
    pub l: Vector3<f32>,
    pub v: Vector3<f32>,
    pub n: Vector3<f32>,
}

impl BrdfInputs {
    fn half_vector(&self) -> Vector3<f32> {
        let h = self.l + self.v;
        // l and v can be exactly opposed at grazing bounce angles
        if h.norm_squared() < f32::EPSILON {
            return self.n;
        }
        h.normalize()
    }

    fn n_dot_l(&self) -> f32 {
        saturate(self.n.dot(&self.l))
    }

    fn n_dot_v(&self) -> f32 {
        saturate(self.n.dot(&self.v))
    }
}

/// Scalar reflectance in `[0, 1]`: the configured diffuse and specular lobes
/// blended by Fresnel. Multiplied against the light contribution by the
/// integrator.
pub fn evaluate(inputs: &BrdfInputs, diffuse: DiffuseMode, specular: SpecularMode) -> f32 {
    let diffuse = match diffuse {
        DiffuseMode::Lambert => lambert(inputs),
        DiffuseMode::OrenNayar => oren_nayar(inputs),
    };
    let specular = match specular {
        SpecularMode::BlinnPhong => blinn_phong(inputs),
        SpecularMode::CookTorrance => cook_torrance(inputs),
    };
    let fresnel = fresnel_schlick(inputs.n_dot_v());
    saturate(lerp(diffuse, specular, fresnel))
}

fn lambert(inputs: &BrdfInputs) -> f32 {
    inputs.n_dot_l()
}

fn oren_nayar(inputs: &BrdfInputs) -> f32 {
    // sigma in radians, mapped from the material's [0, 1] roughness
    let sigma = 0.7071067 * (inputs.roughness * inputs.roughness).atan();
    let sigma2 = sigma * sigma;
    let a = 1.0 - 0.5 * sigma2 / (sigma2 + 0.33);
    let b = 0.45 * sigma2 / (sigma2 + 0.09);

    let n_dot_l = inputs.n_dot_l();
    let n_dot_v = inputs.n_dot_v();
    let theta_i = n_dot_l.acos();
    let theta_r = n_dot_v.acos();
    let alpha = theta_i.max(theta_r);
    let beta = theta_i.min(theta_r);

    // azimuth difference from the projections of l and v onto the surface
    let proj_l = inputs.l - inputs.n * n_dot_l;
    let proj_v = inputs.v - inputs.n * n_dot_v;
    let cos_delta_phi = if proj_l.norm_squared() < f32::EPSILON
        || proj_v.norm_squared() < f32::EPSILON
    {
        // a projection vanishes when a vector is parallel to the normal
        1.0
    } else {
        proj_l.normalize().dot(&proj_v.normalize())
    };

    (a + b * cos_delta_phi.max(0.0) * alpha.sin() * beta.tan()) * n_dot_l
}

fn blinn_phong(inputs: &BrdfInputs) -> f32 {
    let n_dot_h = inputs.n.dot(&inputs.half_vector()).max(0.0);
    n_dot_h.powf(128.0) * (1.0 - inputs.roughness)
}

fn cook_torrance(inputs: &BrdfInputs) -> f32 {
    let n_dot_l = inputs.n_dot_l();
    let n_dot_v = inputs.n_dot_v();
    let n_dot_h = saturate(inputs.n.dot(&inputs.half_vector()));

    let d = ggx_distribution(n_dot_h, inputs.roughness);
    let f = fresnel_schlick(n_dot_v);
    let g = geometry_smith(n_dot_v, n_dot_l, inputs.roughness);

    d * f * g / (4.0 * n_dot_v * n_dot_l).max(GEOMETRY_EPS)
}

fn ggx_distribution(n_dot_h: f32, roughness: f32) -> f32 {
    let a = roughness * roughness;
    let a2 = a * a;
    let denom = n_dot_h * n_dot_h * (a2 - 1.0) + 1.0;
    let denom = std::f32::consts::PI * denom * denom;
    if denom < f32::EPSILON {
        // perfectly smooth at n == h degenerates to a delta spike
        return 1.0;
    }
    a2 / denom
}

fn geometry_smith(n_dot_v: f32, n_dot_l: f32, roughness: f32) -> f32 {
    let r = roughness + 1.0;
    let k = r * r / 8.0;
    schlick_ggx(n_dot_v, k) * schlick_ggx(n_dot_l, k)
}

fn schlick_ggx(n_dot_x: f32, k: f32) -> f32 {
    n_dot_x / (n_dot_x * (1.0 - k) + k + GEOMETRY_EPS)
}

fn fresnel_schlick(n_dot_v: f32) -> f32 {
    0.5 + 0.5 * (1.0 - n_dot_v.max(0.0)).powf(5.0)
}

pub fn saturate(x: f32) -> f32 {
    x.clamp(0.0, 1.0)
}

pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
