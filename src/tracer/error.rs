use std::io;

use thiserror::Error;

/// Failures while decoding or baking a scene. Decoding never hands back a
/// partially populated scene; the first bad field aborts the whole load.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("scene stream truncated or unreadable: {0}")]
    Io(#[from] io::Error),

    #[error("negative {kind} count: {value}")]
    NegativeCount { kind: &'static str, value: i32 },

    #[error("unknown light type {0}")]
    UnknownLightKind(i32),

    #[error("triangle {triangle} references material {index} but the scene has {count}")]
    MaterialIndexOutOfRange {
        triangle: usize,
        index: u32,
        count: usize,
    },
}
