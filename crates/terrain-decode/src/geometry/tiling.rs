//! Tile addressing and the geographic tiling scheme.

use super::{Ellipsoid, Rectangle};

/// Address of a tile in a quadtree pyramid.
///
/// `y` counts rows from the north edge, as in the tiling scheme. Servers
/// using TMS rows convert with [`TileKey::tms_y`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileKey {
    pub x: u32,
    pub y: u32,
    pub level: u32,
}

impl TileKey {
    #[must_use]
    pub fn new(x: u32, y: u32, level: u32) -> Self {
        Self { x, y, level }
    }

    /// Row index counted from the south edge, or `None` when the tile lies
    /// outside the pyramid.
    #[must_use]
    pub fn tms_y(&self, tiling: &impl TilingScheme) -> Option<u32> {
        if !tiling.contains_key(*self) {
            return None;
        }
        tiling
            .number_of_y_tiles_at_level(self.level)
            .checked_sub(self.y)?
            .checked_sub(1)
    }

    /// The child of this tile in the given quadrant.
    #[must_use]
    pub fn child(&self, quadrant: Quadrant) -> Self {
        Self {
            x: self.x * 2 + u32::from(quadrant.is_east()),
            y: self.y * 2 + u32::from(!quadrant.is_north()),
            level: self.level + 1,
        }
    }

    /// Which quadrant of this tile `child` occupies.
    ///
    /// Returns `None` unless `child` is exactly one level deeper and inside
    /// this tile.
    #[must_use]
    pub fn quadrant_of(&self, child: &TileKey) -> Option<Quadrant> {
        if child.level != self.level + 1 || child.x / 2 != self.x || child.y / 2 != self.y {
            return None;
        }
        let east = child.x != self.x * 2;
        let north = child.y == self.y * 2;
        Some(Quadrant::from_sides(east, north))
    }
}

/// One of the four children of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quadrant {
    NorthWest,
    NorthEast,
    SouthWest,
    SouthEast,
}

impl Quadrant {
    #[must_use]
    pub fn from_sides(east: bool, north: bool) -> Self {
        match (east, north) {
            (false, true) => Self::NorthWest,
            (true, true) => Self::NorthEast,
            (false, false) => Self::SouthWest,
            (true, false) => Self::SouthEast,
        }
    }

    #[must_use]
    pub fn is_east(self) -> bool {
        matches!(self, Self::NorthEast | Self::SouthEast)
    }

    #[must_use]
    pub fn is_north(self) -> bool {
        matches!(self, Self::NorthWest | Self::NorthEast)
    }
}

/// Maps tile addresses to geographic rectangles.
pub trait TilingScheme {
    fn ellipsoid(&self) -> &Ellipsoid;

    /// Rectangle covered by the whole pyramid.
    fn rectangle(&self) -> Rectangle;

    fn number_of_x_tiles_at_level(&self, level: u32) -> u32;

    fn number_of_y_tiles_at_level(&self, level: u32) -> u32;

    /// Rectangle covered by one tile, in radians.
    fn tile_xy_to_rectangle(&self, x: u32, y: u32, level: u32) -> Rectangle;

    fn tile_key_to_rectangle(&self, key: TileKey) -> Rectangle {
        self.tile_xy_to_rectangle(key.x, key.y, key.level)
    }

    /// Whether `key` addresses a tile of this pyramid.
    fn contains_key(&self, key: TileKey) -> bool {
        key.level < MAX_LEVEL
            && key.x < self.number_of_x_tiles_at_level(key.level)
            && key.y < self.number_of_y_tiles_at_level(key.level)
    }
}

/// Levels at or past this one would overflow a `u32` tile count.
pub const MAX_LEVEL: u32 = 31;

/// `level_zero << level`, saturating at `u32::MAX`.
fn tiles_at_level(level_zero: u32, level: u32) -> u32 {
    level_zero
        .checked_shl(level)
        .filter(|tiles| tiles >> level == level_zero)
        .unwrap_or(u32::MAX)
}

/// Equirectangular tiling with two root tiles covering the globe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeographicTilingScheme {
    ellipsoid: Ellipsoid,
    rectangle: Rectangle,
    level_zero_tiles_x: u32,
    level_zero_tiles_y: u32,
}

impl GeographicTilingScheme {
    #[must_use]
    pub fn new(ellipsoid: Ellipsoid) -> Self {
        Self {
            ellipsoid,
            rectangle: Rectangle::MAX_VALUE,
            level_zero_tiles_x: 2,
            level_zero_tiles_y: 1,
        }
    }
}

impl Default for GeographicTilingScheme {
    fn default() -> Self {
        Self::new(Ellipsoid::wgs84())
    }
}

impl TilingScheme for GeographicTilingScheme {
    fn ellipsoid(&self) -> &Ellipsoid {
        &self.ellipsoid
    }

    fn rectangle(&self) -> Rectangle {
        self.rectangle
    }

    fn number_of_x_tiles_at_level(&self, level: u32) -> u32 {
        tiles_at_level(self.level_zero_tiles_x, level)
    }

    fn number_of_y_tiles_at_level(&self, level: u32) -> u32 {
        tiles_at_level(self.level_zero_tiles_y, level)
    }

    fn tile_xy_to_rectangle(&self, x: u32, y: u32, level: u32) -> Rectangle {
        let tile_width = self.rectangle.width() / f64::from(self.number_of_x_tiles_at_level(level));
        let tile_height =
            self.rectangle.height() / f64::from(self.number_of_y_tiles_at_level(level));

        let west = f64::from(x) * tile_width + self.rectangle.west;
        let east = (f64::from(x) + 1.0) * tile_width + self.rectangle.west;
        let north = self.rectangle.north - f64::from(y) * tile_height;
        let south = self.rectangle.north - (f64::from(y) + 1.0) * tile_height;

        Rectangle::new(west, south, east, north)
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::{FRAC_PI_2, PI};

    use super::*;

    #[test]
    fn test_level_zero_tiles() {
        let scheme = GeographicTilingScheme::default();
        assert_eq!(scheme.number_of_x_tiles_at_level(0), 2);
        assert_eq!(scheme.number_of_y_tiles_at_level(0), 1);

        let west = scheme.tile_xy_to_rectangle(0, 0, 0);
        assert!((west.west + PI).abs() < 1e-12);
        assert!(west.east.abs() < 1e-12);
        assert!((west.north - FRAC_PI_2).abs() < 1e-12);
        assert!((west.south + FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn test_rows_count_from_north() {
        let scheme = GeographicTilingScheme::default();
        let top = scheme.tile_xy_to_rectangle(0, 0, 1);
        let bottom = scheme.tile_xy_to_rectangle(0, 1, 1);
        assert!(top.south > bottom.south);
        assert!((top.south - bottom.north).abs() < 1e-12);
    }

    #[test]
    fn test_child_and_quadrant_agree() {
        let parent = TileKey::new(3, 1, 2);
        for quadrant in [
            Quadrant::NorthWest,
            Quadrant::NorthEast,
            Quadrant::SouthWest,
            Quadrant::SouthEast,
        ] {
            let child = parent.child(quadrant);
            assert_eq!(parent.quadrant_of(&child), Some(quadrant));
        }
        assert_eq!(parent.quadrant_of(&TileKey::new(0, 0, 3)), None);
        assert_eq!(parent.quadrant_of(&TileKey::new(12, 4, 4)), None);
    }

    #[test]
    fn test_tms_row_flip() {
        let scheme = GeographicTilingScheme::default();
        assert_eq!(TileKey::new(0, 0, 1).tms_y(&scheme), Some(1));
        assert_eq!(TileKey::new(0, 1, 1).tms_y(&scheme), Some(0));
    }

    #[test]
    fn test_addresses_outside_the_pyramid() {
        let scheme = GeographicTilingScheme::default();
        assert_eq!(TileKey::new(0, 5, 0).tms_y(&scheme), None);
        assert_eq!(TileKey::new(2, 0, 0).tms_y(&scheme), None);
        assert_eq!(TileKey::new(0, 0, 40).tms_y(&scheme), None);
        assert!(!scheme.contains_key(TileKey::new(0, 0, MAX_LEVEL)));
        assert!(scheme.contains_key(TileKey::new(3, 1, 1)));
    }

    #[test]
    fn test_tile_counts_saturate() {
        let scheme = GeographicTilingScheme::default();
        assert_eq!(scheme.number_of_x_tiles_at_level(30), 1 << 31);
        assert_eq!(scheme.number_of_x_tiles_at_level(31), u32::MAX);
        assert_eq!(scheme.number_of_y_tiles_at_level(40), u32::MAX);
    }
}
