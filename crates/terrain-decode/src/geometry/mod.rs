//! Geodetic primitives the terrain pipeline is parameterized over.

mod ellipsoid;
mod plane;
mod rectangle;
mod tangent_plane;
mod tiling;

pub use ellipsoid::Ellipsoid;
pub use plane::{Intersect, Plane};
pub use rectangle::{Cartographic, Rectangle, negative_pi_to_pi};
pub use tangent_plane::{EllipsoidTangentPlane, east_north_up};
pub use tiling::{GeographicTilingScheme, Quadrant, TileKey, TilingScheme};
