use super::Vec2;

/// 2D world transform applied to every vertex of a tile batch.
///
/// Component naming follows the uniform packing:
/// `matrix_scale = (scale_x, skew_x, skew_y, scale_w)`, `matrix_pos = pos`.
///
/// ```text
/// | scale_x  skew_y  pos.x |
/// | skew_x   scale_w pos.y |
/// ```
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct WorldTransform {
    pub scale_x: f32,
    pub skew_x: f32,
    pub skew_y: f32,
    pub scale_w: f32,
    pub pos: Vec2,
}

impl WorldTransform {
    pub const IDENTITY: Self = Self {
        scale_x: 1.0,
        skew_x: 0.0,
        skew_y: 0.0,
        scale_w: 1.0,
        pos: Vec2::zero(),
    };

    #[inline]
    pub const fn translation(x: f32, y: f32) -> Self {
        Self {
            pos: Vec2::new(x, y),
            ..Self::IDENTITY
        }
    }

    /// Packed `matrix_scale` uniform value.
    #[inline]
    pub fn matrix_scale(&self) -> [f32; 4] {
        [self.scale_x, self.skew_x, self.skew_y, self.scale_w]
    }

    /// Packed `matrix_pos` uniform value.
    #[inline]
    pub fn matrix_pos(&self) -> [f32; 2] {
        [self.pos.x, self.pos.y]
    }

    /// `false` if any component is NaN or infinite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.scale_x.is_finite()
            && self.skew_x.is_finite()
            && self.skew_y.is_finite()
            && self.scale_w.is_finite()
            && self.pos.is_finite()
    }
}

impl Default for WorldTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}
