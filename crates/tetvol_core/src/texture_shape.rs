//! Packing of linear element arrays into 2D textures
//!
//! Backends cap the width of a 2D texture, so a plain `1 x N` layout breaks
//! down for large meshes. The planner instead picks a power-of-two width close
//! to the square root of the element count and derives the height from it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Width and height of a packed data texture, in texels
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextureShape {
    pub width: u32,
    pub height: u32,
}

impl TextureShape {
    /// Create a shape from explicit dimensions
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Shape of a single-row lookup table
    #[inline]
    pub const fn row(width: u32) -> Self {
        Self { width, height: 1 }
    }

    /// Number of texels covered by this shape
    #[inline]
    pub fn texel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Texel coordinate of a linear element index
    #[inline]
    pub fn texel_of(&self, index: usize) -> (u32, u32) {
        let width = self.width.max(1) as usize;
        ((index % width) as u32, (index / width) as u32)
    }

    /// As a `[width, height]` pair, the layout the shaders read
    #[inline]
    pub fn to_array(self) -> [u32; 2] {
        [self.width, self.height]
    }
}

/// Errors from texture shape planning
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    /// Element count was zero or negative
    InvalidSize(i64),
    /// The computed shape cannot hold the requested element count
    PackingInvariant { size: i64, width: u32, height: u32 },
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeError::InvalidSize(size) => {
                write!(f, "Expecting a positive size, got {}", size)
            }
            ShapeError::PackingInvariant { size, width, height } => write!(
                f,
                "Texture shape computation failed: size={}, width={}, height={}",
                size, width, height
            ),
        }
    }
}

impl std::error::Error for ShapeError {}

/// Compute a packed 2D texture shape able to hold `size` elements
///
/// `width = 2^floor(log2(size) / 2)` and `height = ceil(size / width)`, so the
/// width is always a power of two and never exceeds the height.
pub fn plan(size: i64) -> Result<TextureShape, ShapeError> {
    if size <= 0 {
        return Err(ShapeError::InvalidSize(size));
    }

    // floor(log2(size) / 2) == floor(ilog2(size) / 2) for positive integers
    let exponent = size.ilog2() / 2;
    let width: i64 = 1 << exponent;
    // ceil(size / width) without forming size + width - 1
    let height = (size - 1) / width + 1;

    if width.checked_mul(height).map_or(true, |p| p < size) || height > u32::MAX as i64 {
        return Err(ShapeError::PackingInvariant {
            size,
            width: width as u32,
            height: height.min(u32::MAX as i64) as u32,
        });
    }

    Ok(TextureShape::new(width as u32, height as u32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_ten() {
        assert_eq!(plan(10).unwrap(), TextureShape::new(2, 5));
    }

    #[test]
    fn test_plan_one() {
        assert_eq!(plan(1).unwrap(), TextureShape::new(1, 1));
    }

    #[test]
    fn test_plan_perfect_square() {
        assert_eq!(plan(256).unwrap(), TextureShape::new(16, 16));
        assert_eq!(plan(1 << 20).unwrap(), TextureShape::new(1024, 1024));
    }

    #[test]
    fn test_plan_rejects_non_positive() {
        assert_eq!(plan(0), Err(ShapeError::InvalidSize(0)));
        assert_eq!(plan(-3), Err(ShapeError::InvalidSize(-3)));
    }

    #[test]
    fn test_plan_properties_hold() {
        for size in 1..5000i64 {
            let shape = plan(size).unwrap();
            assert!(shape.width.is_power_of_two(), "width not pow2 for {}", size);
            assert!(shape.texel_count() as i64 >= size, "too small for {}", size);
            assert!(shape.width <= shape.height, "width > height for {}", size);
        }
    }

    #[test]
    fn test_plan_large_counts() {
        for &size in &[1_000_003i64, 12_345_678, 100_000_000] {
            let shape = plan(size).unwrap();
            assert!(shape.texel_count() as i64 >= size);
            // Padding stays below one row
            assert!((shape.texel_count() as i64) - size < shape.width as i64);
        }
    }

    #[test]
    fn test_plan_extreme() {
        // Height would need 2^32 rows, which a u32 extent cannot hold
        let err = plan(i64::MAX).unwrap_err();
        assert!(matches!(err, ShapeError::PackingInvariant { width, .. } if width == 1 << 31));

        let largest = (1i64 << 31) * u32::MAX as i64;
        let shape = plan(largest).unwrap();
        assert_eq!(shape, TextureShape::new(1 << 31, u32::MAX));
    }

    #[test]
    fn test_texel_of() {
        let shape = TextureShape::new(4, 3);
        assert_eq!(shape.texel_of(0), (0, 0));
        assert_eq!(shape.texel_of(5), (1, 1));
        assert_eq!(shape.texel_of(11), (3, 2));
    }

    #[test]
    fn test_error_display() {
        let msg = format!("{}", ShapeError::InvalidSize(-1));
        assert!(msg.contains("positive"));
        assert!(msg.contains("-1"));
    }
}
