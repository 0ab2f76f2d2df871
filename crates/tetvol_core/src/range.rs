//! Value ranges used for shader-side normalization

use serde::{Deserialize, Serialize};

/// Summary of a channel's value distribution
///
/// Uploaded to the shaders as a `vec4` of `[min, max, range, scale]` where
/// `scale` is `1 / range`, or `1` for constant data.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataRange {
    pub min: f32,
    pub max: f32,
    pub range: f32,
    pub scale: f32,
}

impl Default for DataRange {
    fn default() -> Self {
        Self::UNIT
    }
}

impl DataRange {
    /// Placeholder range used before any data has arrived
    pub const UNIT: Self = Self { min: 0.0, max: 1.0, range: 1.0, scale: 1.0 };

    /// Compute the range of a sequence in a single pass
    ///
    /// Returns `None` for an empty sequence.
    pub fn compute<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f32>,
    {
        let mut iter = values.into_iter();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));

        let range = max - min;
        let scale = if range > 0.0 { 1.0 / range } else { 1.0 };
        Some(Self { min, max, range, scale })
    }

    /// Layout consumed by the shaders
    #[inline]
    pub fn to_array(&self) -> [f32; 4] {
        [self.min, self.max, self.range, self.scale]
    }

    /// Map a value into `[0, 1]` relative to this range
    #[inline]
    pub fn normalize(&self, value: f32) -> f32 {
        (value - self.min) * self.scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_example() {
        let r = DataRange::compute([1.0, 5.0, 3.0, 2.0]).unwrap();
        assert_eq!(r.to_array(), [1.0, 5.0, 4.0, 0.25]);
    }

    #[test]
    fn test_range_single_value() {
        let r = DataRange::compute([7.0]).unwrap();
        assert_eq!(r.to_array(), [7.0, 7.0, 0.0, 1.0]);
    }

    #[test]
    fn test_range_empty() {
        assert!(DataRange::compute(std::iter::empty()).is_none());
    }

    #[test]
    fn test_range_negative_values() {
        let r = DataRange::compute([-2.0, -8.0, 0.0]).unwrap();
        assert_eq!(r.min, -8.0);
        assert_eq!(r.max, 0.0);
        assert_eq!(r.range, 8.0);
        assert_eq!(r.scale, 0.125);
    }

    #[test]
    fn test_default_is_unit() {
        assert_eq!(DataRange::default().to_array(), [0.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_normalize() {
        let r = DataRange::compute([2.0, 6.0]).unwrap();
        assert_eq!(r.normalize(2.0), 0.0);
        assert_eq!(r.normalize(4.0), 0.5);
        assert_eq!(r.normalize(6.0), 1.0);
    }
}
