/// Drawing-area size in world units.
///
/// Uploaded as the `resolution` uniform; the vertex stage divides by it to
/// reach clip space.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Viewport covering a texture of `width` x `height` texels.
    #[inline]
    pub fn from_extent(width: u32, height: u32) -> Self {
        Self::new(width as f32, height as f32)
    }

    /// Positive and finite in both axes.
    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }
}
