//! In-memory backend
//!
//! Keeps every texture and buffer in host memory. Used for headless
//! inspection of what a real backend would receive, and by the tests.

use crate::backend::{
    BackendError, BufferDescriptor, GeometryDescriptor, GraphicsBackend, ProgramDescriptor,
    TextureDescriptor,
};
use crate::method::{BlendConfig, DefineFlags, Side};
use crate::texture_shape::TextureShape;

/// Texture stored in host memory
#[derive(Clone, Debug, PartialEq)]
pub struct HostTexture {
    pub label: String,
    pub shape: TextureShape,
    pub components: u32,
    pub texels: Vec<f32>,
    /// Number of completed writes
    pub writes: usize,
}

/// Instance buffer stored in host memory
#[derive(Clone, Debug, PartialEq)]
pub struct HostBuffer {
    pub label: String,
    pub item_size: u32,
    pub contents: Vec<f32>,
    pub writes: usize,
}

/// Recorded program configuration
#[derive(Clone, Debug, PartialEq)]
pub struct HostProgram {
    pub label: String,
    pub defines: DefineFlags,
    pub transparent: bool,
    pub blend: Option<BlendConfig>,
    pub side: Side,
    pub depth_test: bool,
    pub depth_write: bool,
}

/// Recorded instanced geometry
#[derive(Clone, Debug, PartialEq)]
pub struct HostGeometry {
    pub label: String,
    pub strip_indices: Vec<u16>,
    pub local_vertices: Vec<f32>,
    pub vertex_ids: Vec<f32>,
    pub instance_count: u32,
}

/// Backend that keeps all objects in host memory
#[derive(Debug)]
pub struct HostBackend {
    max_texture_dimension: u32,
    fail_writes: bool,
    textures_created: usize,
    programs_created: usize,
}

impl Default for HostBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HostBackend {
    /// Matches the default 2D texture limit of common GPU backends
    pub const DEFAULT_MAX_TEXTURE_DIMENSION: u32 = 8192;

    pub fn new() -> Self {
        Self {
            max_texture_dimension: Self::DEFAULT_MAX_TEXTURE_DIMENSION,
            fail_writes: false,
            textures_created: 0,
            programs_created: 0,
        }
    }

    /// Override the maximum texture width and height
    pub fn with_max_texture_dimension(mut self, limit: u32) -> Self {
        self.max_texture_dimension = limit;
        self
    }

    /// Make every subsequent texture and buffer write fail
    ///
    /// Simulates a backend rejecting transfers.
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Total number of textures created, reallocations included
    pub fn textures_created(&self) -> usize {
        self.textures_created
    }

    pub fn programs_created(&self) -> usize {
        self.programs_created
    }

    fn check_dimension(&self, what: &str, requested: u32) -> Result<(), BackendError> {
        if requested > self.max_texture_dimension {
            return Err(BackendError::LimitExceeded {
                what: what.to_string(),
                requested,
                limit: self.max_texture_dimension,
            });
        }
        Ok(())
    }

    fn check_writable(&self, label: &str) -> Result<(), BackendError> {
        if self.fail_writes {
            return Err(BackendError::Other(format!("write to '{}' rejected", label)));
        }
        Ok(())
    }
}

impl GraphicsBackend for HostBackend {
    type Texture = HostTexture;
    type Buffer = HostBuffer;
    type Program = HostProgram;
    type Geometry = HostGeometry;

    fn create_texture(&mut self, desc: &TextureDescriptor<'_>) -> Result<HostTexture, BackendError> {
        self.check_dimension("texture width", desc.shape.width)?;
        self.check_dimension("texture height", desc.shape.height)?;
        self.textures_created += 1;
        Ok(HostTexture {
            label: desc.label.to_string(),
            shape: desc.shape,
            components: desc.components,
            texels: vec![0.0; desc.value_count()],
            writes: 0,
        })
    }

    fn write_texture(&mut self, texture: &mut HostTexture, texels: &[f32]) -> Result<(), BackendError> {
        self.check_writable(&texture.label)?;
        if texels.len() != texture.texels.len() {
            return Err(BackendError::SizeMismatch {
                label: texture.label.clone(),
                expected: texture.texels.len(),
                actual: texels.len(),
            });
        }
        texture.texels.copy_from_slice(texels);
        texture.writes += 1;
        Ok(())
    }

    fn create_buffer(
        &mut self,
        desc: &BufferDescriptor<'_>,
        contents: &[f32],
    ) -> Result<HostBuffer, BackendError> {
        Ok(HostBuffer {
            label: desc.label.to_string(),
            item_size: desc.item_size,
            contents: contents.to_vec(),
            writes: 0,
        })
    }

    fn write_buffer(&mut self, buffer: &mut HostBuffer, contents: &[f32]) -> Result<(), BackendError> {
        self.check_writable(&buffer.label)?;
        if contents.len() != buffer.contents.len() {
            return Err(BackendError::SizeMismatch {
                label: buffer.label.clone(),
                expected: buffer.contents.len(),
                actual: contents.len(),
            });
        }
        buffer.contents.copy_from_slice(contents);
        buffer.writes += 1;
        Ok(())
    }

    fn create_program(&mut self, desc: &ProgramDescriptor<'_>) -> Result<HostProgram, BackendError> {
        self.programs_created += 1;
        Ok(HostProgram {
            label: desc.label.to_string(),
            defines: desc.defines,
            transparent: desc.transparent,
            blend: desc.blend,
            side: desc.side,
            depth_test: desc.depth_test,
            depth_write: desc.depth_write,
        })
    }

    fn create_geometry(&mut self, desc: &GeometryDescriptor<'_>) -> Result<HostGeometry, BackendError> {
        Ok(HostGeometry {
            label: desc.label.to_string(),
            strip_indices: desc.strip_indices.to_vec(),
            local_vertices: desc.local_vertices.to_vec(),
            vertex_ids: desc.vertex_ids.to_vec(),
            instance_count: desc.instance_count,
        })
    }
}
