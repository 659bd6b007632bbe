use nalgebra::{Vector3, Vector4};

use crate::tracer::brdf::saturate;
use crate::tracer::scene::{Light, LightKind, Scene};
use crate::tracer::trace::{HitInfo, Ray};

// shadow rays start this far off the surface along the light direction
pub const SHADOW_BIAS: f32 = 0.01;

const ONE_OVER_360: f32 = 1.0 / 360.0;

/// Unit direction from the hit toward the light. Directional lights have no
/// position; only their orientation matters.
pub fn light_direction(light: &Light, hit: &HitInfo) -> Vector3<f32> {
    match light.kind {
        LightKind::Directional => -light.forward,
        _ => (light.position - hit.position).normalize(),
    }
}

/// Incoming radiance from one light at the hit point: zero when the surface
/// faces away or a shadow ray finds an occluder, otherwise the light's color
/// scaled by its distance falloff. The caller multiplies in the surface
/// reflectance.
pub fn color_contribution(light: &Light, hit: &HitInfo, scene: &Scene) -> Vector4<f32> {
    let to_light = light_direction(light, hit);
    if hit.normal.dot(&to_light) <= 0.0 {
        return Vector4::zeros();
    }

    let distance = match light.kind {
        LightKind::Directional => f32::INFINITY,
        _ => (light.position - hit.position).norm(),
    };

    let shadow_ray = Ray {
        origin: hit.position + to_light * SHADOW_BIAS,
        direction: to_light,
    };
    if scene.any_hit(&shadow_ray, distance) {
        return Vector4::zeros();
    }

    let power = match light.kind {
        LightKind::Directional => light.intensity,
        LightKind::Point => light.intensity / (distance * distance),
        LightKind::Spot => {
            let dot_to_outer = (-to_light).dot(&light.forward);
            let factor = 1.0 - light.angle * ONE_OVER_360;
            if dot_to_outer <= factor {
                return Vector4::zeros();
            }
            let decay = saturate((dot_to_outer - factor) / (1.0 - factor));
            light.intensity * decay / (distance * distance)
        }
    };

    light.color * power
}
