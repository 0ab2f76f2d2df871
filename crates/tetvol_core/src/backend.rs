//! Operations the renderer needs from a graphics backend
//!
//! The core never touches a graphics API directly. It describes textures,
//! instance buffers, programs and instanced geometry, and a backend turns
//! those descriptions into real objects. Writes are fire-and-forget: a
//! backend may stage them and perform the transfer at its next submission.

use std::borrow::Cow;
use std::fmt;

use crate::method::{BlendConfig, DefineFlags, Side};
use crate::texture_shape::TextureShape;

/// Description of a packed `f32` data texture
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureDescriptor<'a> {
    pub label: &'a str,
    pub shape: TextureShape,
    /// Components per texel (1..=4)
    pub components: u32,
}

impl TextureDescriptor<'_> {
    /// Number of `f32` values a full upload must contain
    #[inline]
    pub fn value_count(&self) -> usize {
        self.shape.texel_count() * self.components as usize
    }
}

/// Description of a per-instance `f32` attribute buffer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferDescriptor<'a> {
    pub label: &'a str,
    pub item_size: u32,
    /// Whether the contents are rewritten after creation
    pub dynamic: bool,
}

/// The two opaque shader blobs every program is built from
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderSources {
    pub vertex: Cow<'static, str>,
    pub fragment: Cow<'static, str>,
}

impl ShaderSources {
    pub fn new(vertex: impl Into<Cow<'static, str>>, fragment: impl Into<Cow<'static, str>>) -> Self {
        Self { vertex: vertex.into(), fragment: fragment.into() }
    }
}

/// Everything needed to build a shader program for one method
#[derive(Clone, Copy, Debug)]
pub struct ProgramDescriptor<'a> {
    pub label: &'a str,
    pub shaders: &'a ShaderSources,
    pub defines: DefineFlags,
    pub transparent: bool,
    /// `None` selects the backend's normal blending
    pub blend: Option<BlendConfig>,
    pub side: Side,
    pub depth_test: bool,
    pub depth_write: bool,
}

/// Fixed topology of one instanced tetrahedron
#[derive(Clone, Copy, Debug)]
pub struct GeometryDescriptor<'a> {
    pub label: &'a str,
    /// Triangle strip covering the four faces
    pub strip_indices: &'a [u16],
    /// Per-vertex rotation of the local vertex indices, 4 values per vertex
    pub local_vertices: &'a [f32],
    /// Per-vertex local id, stand-in for a built-in vertex index
    pub vertex_ids: &'a [f32],
    pub instance_count: u32,
}

/// Error reported by a backend operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The requested object exceeds a device limit
    LimitExceeded { what: String, requested: u32, limit: u32 },
    /// Data length does not match the target object
    SizeMismatch { label: String, expected: usize, actual: usize },
    /// Shader or pipeline creation failed
    Program(String),
    /// Any other backend-specific failure
    Other(String),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::LimitExceeded { what, requested, limit } => {
                write!(f, "{} of {} exceeds device limit {}", what, requested, limit)
            }
            BackendError::SizeMismatch { label, expected, actual } => write!(
                f,
                "size mismatch for '{}': expected {} values, got {}",
                label, expected, actual
            ),
            BackendError::Program(msg) => write!(f, "program creation failed: {}", msg),
            BackendError::Other(msg) => write!(f, "backend error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

/// Capabilities a graphics backend provides to the renderer
pub trait GraphicsBackend {
    type Texture;
    type Buffer;
    type Program;
    type Geometry;

    /// Create a zero-filled data texture
    fn create_texture(&mut self, desc: &TextureDescriptor<'_>) -> Result<Self::Texture, BackendError>;

    /// Replace the full contents of a data texture
    ///
    /// `texels` holds `desc.value_count()` values of the descriptor the
    /// texture was created with.
    fn write_texture(&mut self, texture: &mut Self::Texture, texels: &[f32]) -> Result<(), BackendError>;

    /// Create an instance attribute buffer holding `contents`
    fn create_buffer(
        &mut self,
        desc: &BufferDescriptor<'_>,
        contents: &[f32],
    ) -> Result<Self::Buffer, BackendError>;

    /// Replace the contents of an instance attribute buffer
    fn write_buffer(&mut self, buffer: &mut Self::Buffer, contents: &[f32]) -> Result<(), BackendError>;

    /// Compile a program for one method
    fn create_program(&mut self, desc: &ProgramDescriptor<'_>) -> Result<Self::Program, BackendError>;

    /// Create the instanced geometry a drawable renders with
    fn create_geometry(&mut self, desc: &GeometryDescriptor<'_>) -> Result<Self::Geometry, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texture_value_count() {
        let desc = TextureDescriptor {
            label: "t_coordinates",
            shape: TextureShape::new(4, 3),
            components: 3,
        };
        assert_eq!(desc.value_count(), 36);
    }

    #[test]
    fn test_backend_error_display() {
        let err = BackendError::LimitExceeded {
            what: "texture width".into(),
            requested: 20000,
            limit: 8192,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("20000"));
        assert!(msg.contains("8192"));
    }
}
