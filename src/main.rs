use std::fs::File;
use std::io::BufReader;
use std::sync::atomic::AtomicBool;
use std::time::Instant;

use mesh_pathtracer::tracer::codec;
use mesh_pathtracer::tracer::integrator::Renderer;
use mesh_pathtracer::tracer::scene::Scene;
use mesh_pathtracer::tracer::settings::TracerSettings;
use mesh_pathtracer::tracer::tonemap;

fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let scene_path = args.next().unwrap_or_else(|| {
        eprintln!("usage: mesh-pathtracer <scene.bin> [settings.json] [out.png]");
        std::process::exit(2);
    });
    let settings_path = args.next();
    let out_path = args.next().unwrap_or_else(|| "out.png".to_string());

    let settings = match settings_path {
        Some(path) => {
            let file = File::open(&path).unwrap();
            serde_json::from_reader(BufReader::new(file)).unwrap()
        }
        None => TracerSettings::default(),
    };

    let mut reader = BufReader::new(File::open(&scene_path).unwrap());
    let file = codec::decode_scene(&mut reader).unwrap();
    log::info!(
        "loaded {}: {} triangles, {} materials, {} lights",
        scene_path,
        file.triangles.len(),
        file.materials.len(),
        file.lights.len()
    );

    let started = Instant::now();
    let scene = Scene::bake(file, &settings).unwrap();
    log::info!(
        "baked {} nodes in {:.1?}",
        scene.nodes.len(),
        started.elapsed()
    );

    let mut renderer = Renderer::new(scene, settings);
    let cancel = AtomicBool::new(false);
    renderer.render(&cancel);

    // pixel (0, 0) is the bottom-left corner; image files run top-down
    let tonemapped = renderer.tonemapped();
    let width = settings.width as usize;
    let mut flipped = Vec::with_capacity(tonemapped.len());
    for row in (0..settings.height as usize).rev() {
        flipped.extend_from_slice(&tonemapped[row * width..(row + 1) * width]);
    }
    let bytes = tonemap::to_rgba8(&flipped);
    let image = image::RgbaImage::from_raw(settings.width, settings.height, bytes).unwrap();
    image.save(&out_path).unwrap();
    log::info!("wrote {}", out_path);
}
