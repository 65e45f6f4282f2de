mod entered;
mod geometry;
mod registry;

pub use entered::*;
pub use geometry::*;
pub use registry::*;
