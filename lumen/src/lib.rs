//! Two-level bounding volume hierarchy: per-mesh trees (BLAS) referenced by a
//! scene-wide tree over instances (TLAS), flattened into a single array that
//! can be traversed on the CPU (see [`SceneData::closest_hit()`]) or uploaded
//! verbatim to the GPU.

mod bvh;
mod config;
mod error;
mod instance;
mod mesh;
mod scene;
mod utils;

pub use lumen_gpu as gpu;

pub use self::bvh::*;
pub use self::config::*;
pub use self::error::*;
pub use self::instance::*;
pub use self::mesh::*;
pub use self::scene::*;
pub use self::utils::*;
