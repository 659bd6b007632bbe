use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Instant;

use nalgebra::{Vector3, Vector4};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use threadpool::ThreadPool;

use crate::tracer::brdf::{self, BrdfInputs};
use crate::tracer::lighting;
use crate::tracer::scene::Scene;
use crate::tracer::settings::TracerSettings;
use crate::tracer::tonemap;
use crate::tracer::trace::Ray;

// bounce rays start this far off the surface along the normal
const BOUNCE_BIAS: f32 = 1e-4;
// paths dimmer than this per unit of depth gamble on termination
const ROULETTE_FLOOR: f32 = 0.1;

pub fn reflect(incoming: &Vector3<f32>, normal: &Vector3<f32>) -> Vector3<f32> {
    incoming - normal * (2.0 * incoming.dot(normal))
}

/// Uniform unit direction in the hemisphere around `normal`, by rejection
/// sampling the unit ball and flipping into the upper half.
pub fn random_hemisphere_direction(normal: &Vector3<f32>, rng: &mut SmallRng) -> Vector3<f32> {
    loop {
        let candidate = Vector3::new(
            rng.gen_range(-1.0f32..1.0),
            rng.gen_range(-1.0f32..1.0),
            rng.gen_range(-1.0f32..1.0),
        );
        let length_sq = candidate.norm_squared();
        if length_sq > 1.0 || length_sq < 1e-4 {
            continue;
        }
        let candidate = candidate / length_sq.sqrt();
        return if candidate.dot(normal) < 0.0 {
            -candidate
        } else {
            candidate
        };
    }
}

/// Radiance carried back along `ray`. Misses are transparent black; emissive
/// hits return their material color as-is. Everything else sums the shadowed
/// contribution of the leaf's relevant lights, recurses along one roulette-
/// gated bounce, and filters the total through the surface albedo.
pub fn path_radiance(
    scene: &Scene,
    settings: &TracerSettings,
    ray: &Ray,
    rng: &mut SmallRng,
    depth: u32,
) -> Vector4<f32> {
    let hit = match scene.nearest_hit(ray, f32::INFINITY) {
        Some(hit) => hit,
        None => return Vector4::new(0.0, 0.0, 0.0, 1.0),
    };

    let material = &scene.materials[hit.material_index as usize];
    if material.is_emissive {
        return material.color;
    }

    let mut energy = Vector4::new(0.0, 0.0, 0.0, 1.0);

    let view = -hit.incoming;
    for &l in &scene.nodes[hit.node_index as usize].light_indices {
        let light = &scene.lights[l as usize];
        let contribution = lighting::color_contribution(light, &hit, scene);
        if contribution == Vector4::zeros() {
            continue;
        }
        let inputs = BrdfInputs {
            roughness: material.roughness,
            l: lighting::light_direction(light, &hit),
            v: view,
            n: hit.normal,
        };
        let reflectance = brdf::evaluate(&inputs, settings.diffuse_mode, settings.specular_mode);
        energy += contribution * reflectance;
    }

    if depth < settings.indirect_bounces {
        let mirrored = reflect(&hit.incoming, &hit.normal);
        let scattered = random_hemisphere_direction(&hit.normal, rng);
        let mut direction = mirrored.lerp(&scattered, material.roughness);
        if direction.norm_squared() < 1e-8 {
            direction = scattered;
        }
        let direction = direction.normalize();

        // the bounce reflectance gates the roulette draw; reflective paths
        // skip the draw entirely and keep their rng stream intact
        let inputs = BrdfInputs {
            roughness: material.roughness,
            l: direction,
            v: view,
            n: hit.normal,
        };
        let weight = brdf::evaluate(&inputs, settings.diffuse_mode, settings.specular_mode);
        let terminated =
            weight < ROULETTE_FLOOR * depth as f32 && rng.gen_range(0.0f32..1.0) < 0.5;
        if !terminated {
            let bounce = Ray {
                origin: hit.position + hit.normal * BOUNCE_BIAS,
                direction,
            };
            let mut indirect = path_radiance(scene, settings, &bounce, rng, depth + 1);
            if depth == 0 {
                indirect *= settings.indirect_power;
            }
            energy += indirect;
        }
    }

    let mut out = energy.component_mul(&material.color);
    out.w = 1.0;
    out
}

/// Progressive renderer. Each iteration traces one sample per pixel across
/// the worker pool and folds it into the running average, so the image is
/// presentable after the first pass and converges from there.
pub struct Renderer {
    scene: Arc<Scene>,
    settings: TracerSettings,
    pool: ThreadPool,
    hdr: Vec<Vector4<f32>>,
    iterations: u32,
}

impl Renderer {
    pub fn new(scene: Scene, settings: TracerSettings) -> Renderer {
        let pixel_count = (settings.width * settings.height) as usize;
        Renderer {
            scene: Arc::new(scene),
            settings,
            pool: ThreadPool::default(),
            hdr: vec![Vector4::new(0.0, 0.0, 0.0, 1.0); pixel_count],
            iterations: 0,
        }
    }

    /// Traces one sample per pixel and blends it into the accumulator with
    /// weight `1 / (iteration + 1)`. Pixel seeds mix the iteration into the
    /// high bits so no pixel repeats its sample sequence across iterations.
    pub fn render_iteration(&mut self) {
        let pixel_count = self.hdr.len();
        if pixel_count == 0 {
            self.iterations += 1;
            return;
        }
        let chunk = pixel_count.div_ceil(self.pool.max_count()).max(1);

        let (tx, rx) = mpsc::channel();
        for start in (0..pixel_count).step_by(chunk) {
            let end = (start + chunk).min(pixel_count);
            let scene = Arc::clone(&self.scene);
            let settings = self.settings;
            let iteration = self.iterations;
            let tx = tx.clone();
            self.pool.execute(move || {
                let mut samples = Vec::with_capacity(end - start);
                for index in start..end {
                    let mut rng =
                        SmallRng::seed_from_u64(((iteration as u64) << 32) ^ index as u64);
                    let x = index as u32 % settings.width;
                    let y = index as u32 / settings.width;
                    let ray = scene
                        .camera
                        .primary_ray(x, y, settings.width, settings.height);
                    samples.push(path_radiance(&scene, &settings, &ray, &mut rng, 0));
                }
                // fails only if the receiver is gone, and then nobody cares
                let _ = tx.send((start, samples));
            });
        }
        drop(tx);

        let blend = 1.0 / (self.iterations + 1) as f32;
        for (start, samples) in rx {
            for (offset, sample) in samples.into_iter().enumerate() {
                let slot = &mut self.hdr[start + offset];
                *slot = *slot * (1.0 - blend) + sample * blend;
            }
        }
        self.pool.join();

        self.iterations += 1;
    }

    /// Runs iterations until the configured count is reached or `cancel` is
    /// raised. The flag is checked between iterations only, so the buffer is
    /// always left at a consistent whole-iteration state.
    pub fn render(&mut self, cancel: &AtomicBool) {
        while self.iterations < self.settings.max_iterations {
            if cancel.load(Ordering::Relaxed) {
                log::info!("render cancelled after {} iterations", self.iterations);
                return;
            }
            let started = Instant::now();
            self.render_iteration();
            log::info!(
                "iteration {}/{} took {:.1?}",
                self.iterations,
                self.settings.max_iterations,
                started.elapsed()
            );
        }
    }

    pub fn tonemapped(&self) -> Vec<Vector4<f32>> {
        self.hdr.iter().map(tonemap::aces_filter).collect()
    }

    pub fn hdr_buffer(&self) -> &[Vector4<f32>] {
        &self.hdr
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }
}
