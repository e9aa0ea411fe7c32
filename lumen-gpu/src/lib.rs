//! Flattened, two-level BVH layout and its traversal.
//!
//! Everything here operates on plain slices (as uploaded to / shared with
//! the device), so that the same code can run on either side.

#![allow(clippy::len_without_is_empty)]
#![allow(clippy::manual_range_contains)]

mod bvh_ptr;
mod bvh_stack;
mod bvh_view;
mod flat_node;
mod hit;
mod instance;
mod material;
mod ray;
mod triangle;
mod triangles;
mod world;

pub use self::bvh_ptr::*;
pub use self::bvh_stack::*;
pub use self::bvh_view::*;
pub use self::flat_node::*;
pub use self::hit::*;
pub use self::instance::*;
pub use self::material::*;
pub use self::ray::*;
pub use self::triangle::*;
pub use self::triangles::*;
pub use self::world::*;

/// Maximum number of entries on the traversal stack.
///
/// Each TLAS leaf visited costs one extra entry (to mark the way back into
/// world space); when the stack fills up, further pushes are dropped and
/// reported through [`TraceStats::overflowed`].
pub const BVH_STACK_SIZE: usize = 64;
