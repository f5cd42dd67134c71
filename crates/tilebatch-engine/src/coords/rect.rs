use super::Vec2;

/// Axis-aligned rectangle (top-left origin).
///
/// Used both for tile footprints in world units and for tile cells in atlas
/// texel space.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Rect {
    pub origin: Vec2,
    pub size: Vec2,
}

impl Rect {
    #[inline]
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            origin: Vec2::new(x, y),
            size: Vec2::new(w, h),
        }
    }

    #[inline]
    pub fn min(self) -> Vec2 {
        self.origin
    }

    #[inline]
    pub fn max(self) -> Vec2 {
        self.origin + self.size
    }

    /// Cell `(col, row)` of a uniform grid of `cell`-sized tiles.
    #[inline]
    pub fn grid_cell(col: u32, row: u32, cell: Vec2) -> Self {
        Rect::new(col as f32 * cell.x, row as f32 * cell.y, cell.x, cell.y)
    }
}
