pub mod camera;
pub mod tracer;
