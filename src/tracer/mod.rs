pub mod brdf;
pub mod bvh;
pub mod codec;
pub mod error;
pub mod integrator;
pub mod lighting;
pub mod scene;
pub mod settings;
pub mod tonemap;
pub mod trace;
