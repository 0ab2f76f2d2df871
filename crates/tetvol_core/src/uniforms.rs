//! Uniform values: per-channel uniforms and the shared scene block

use crate::error::RenderError;
use crate::texture_shape::TextureShape;

/// A scalar or vector uniform backing a uniform-associated channel
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    Scalar(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
}

impl UniformValue {
    /// Zero value with `item_size` components
    pub fn zeroed(item_size: usize) -> Result<Self, RenderError> {
        match item_size {
            1 => Ok(UniformValue::Scalar(0.0)),
            2 => Ok(UniformValue::Vec2([0.0; 2])),
            3 => Ok(UniformValue::Vec3([0.0; 3])),
            4 => Ok(UniformValue::Vec4([0.0; 4])),
            other => Err(RenderError::UnsupportedItemSize(other)),
        }
    }

    #[inline]
    pub fn item_size(&self) -> usize {
        self.as_slice().len()
    }

    pub fn as_slice(&self) -> &[f32] {
        match self {
            UniformValue::Scalar(v) => std::slice::from_ref(v),
            UniformValue::Vec2(v) => v,
            UniformValue::Vec3(v) => v,
            UniformValue::Vec4(v) => v,
        }
    }

    fn as_mut_slice(&mut self) -> &mut [f32] {
        match self {
            UniformValue::Scalar(v) => std::slice::from_mut(v),
            UniformValue::Vec2(v) => v,
            UniformValue::Vec3(v) => v,
            UniformValue::Vec4(v) => v,
        }
    }

    /// Overwrite in place; `values` must have exactly `item_size` entries
    pub fn set(&mut self, channel: &str, values: &[f32]) -> Result<(), RenderError> {
        let expected = self.item_size();
        if values.len() != expected {
            return Err(RenderError::UniformLength {
                channel: channel.to_string(),
                expected,
                actual: values.len(),
            });
        }
        self.as_mut_slice().copy_from_slice(values);
        Ok(())
    }
}

/// Uniforms shared by every drawable regardless of encoding
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneUniforms {
    pub time: f32,
    /// `sin((i + 1) * pi * time)` for i in 0..4
    pub oscillators: [f32; 4],
    /// World-space camera direction
    pub view_direction: [f32; 3],
    pub view_projection: [[f32; 4]; 4],
    pub constant_color: [f32; 3],
    pub cell_texture_shape: TextureShape,
    pub vertex_texture_shape: TextureShape,
}

impl Default for SceneUniforms {
    fn default() -> Self {
        Self {
            time: 0.0,
            oscillators: [0.0; 4],
            view_direction: [0.0, 0.0, -1.0],
            view_projection: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
            constant_color: [0.8, 0.8, 0.8],
            cell_texture_shape: TextureShape::default(),
            vertex_texture_shape: TextureShape::default(),
        }
    }
}

impl SceneUniforms {
    /// Advance the animation clock
    pub fn set_time(&mut self, time: f32) {
        self.time = time;
        for (i, osc) in self.oscillators.iter_mut().enumerate() {
            *osc = ((i as f32 + 1.0) * std::f32::consts::PI * time).sin();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeroed_sizes() {
        assert_eq!(UniformValue::zeroed(1).unwrap(), UniformValue::Scalar(0.0));
        assert_eq!(UniformValue::zeroed(3).unwrap().item_size(), 3);
        assert_eq!(UniformValue::zeroed(4).unwrap().as_slice(), &[0.0; 4]);
    }

    #[test]
    fn test_zeroed_rejects_bad_size() {
        assert_eq!(UniformValue::zeroed(0), Err(RenderError::UnsupportedItemSize(0)));
        assert_eq!(UniformValue::zeroed(5), Err(RenderError::UnsupportedItemSize(5)));
    }

    #[test]
    fn test_set_checks_length() {
        let mut value = UniformValue::zeroed(2).unwrap();
        assert!(value.set("offset", &[1.0]).is_err());
        value.set("offset", &[1.0, 2.0]).unwrap();
        assert_eq!(value, UniformValue::Vec2([1.0, 2.0]));
    }

    #[test]
    fn test_oscillators() {
        let mut uniforms = SceneUniforms::default();
        uniforms.set_time(0.5);
        assert_eq!(uniforms.time, 0.5);
        // sin(pi/2), sin(pi), sin(3pi/2), sin(2pi)
        let expected = [1.0, 0.0, -1.0, 0.0];
        for (got, want) in uniforms.oscillators.iter().zip(expected) {
            assert!((got - want).abs() < 1e-5, "{} vs {}", got, want);
        }
    }

    #[test]
    fn test_default_constant_color() {
        assert_eq!(SceneUniforms::default().constant_color, [0.8, 0.8, 0.8]);
    }
}
