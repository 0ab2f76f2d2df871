//! GPU-compatible data types for the tetrahedral mesh pipeline
//!
//! These types are designed to match the shader layouts exactly.

use bytemuck::{Pod, Zeroable};
use tetvol_core::{DataRange, SceneUniforms};

/// Bit in [`MeshUniforms::uniform_mask`] set when density is a uniform
pub const UNIFORM_DENSITY: u32 = 1 << 0;
/// Bit in [`MeshUniforms::uniform_mask`] set when emission is a uniform
pub const UNIFORM_EMISSION: u32 = 1 << 1;

/// Per-drawable uniform block
/// Layout: 176 bytes total (must match tetra_vertex.wgsl MeshUniforms)
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct MeshUniforms {
    /// View-projection matrix (64 bytes)
    pub view_projection: [[f32; 4]; 4],
    /// View direction + time (16 bytes)
    pub view_direction: [f32; 3],
    pub time: f32,
    pub oscillators: [f32; 4],
    /// min, max, range, scale
    pub density_range: [f32; 4],
    pub emission_range: [f32; 4],
    /// Constant color + uniform channel mask (16 bytes)
    pub constant_color: [f32; 3],
    pub uniform_mask: u32,
    pub cell_texture_shape: [u32; 2],
    pub vertex_texture_shape: [u32; 2],
    /// Values of uniform-associated channels: density, emission
    pub channel_values: [f32; 4],
}

impl Default for MeshUniforms {
    fn default() -> Self {
        Self::from_scene(&SceneUniforms::default(), DataRange::UNIT, DataRange::UNIT)
    }
}

impl MeshUniforms {
    /// Build the block from the shared scene uniforms and the range tuples
    pub fn from_scene(scene: &SceneUniforms, density: DataRange, emission: DataRange) -> Self {
        Self {
            view_projection: scene.view_projection,
            view_direction: scene.view_direction,
            time: scene.time,
            oscillators: scene.oscillators,
            density_range: density.to_array(),
            emission_range: emission.to_array(),
            constant_color: scene.constant_color,
            uniform_mask: 0,
            cell_texture_shape: scene.cell_texture_shape.to_array(),
            vertex_texture_shape: scene.vertex_texture_shape.to_array(),
            channel_values: [0.0; 4],
        }
    }

    /// Feed density from a uniform instead of a texture
    pub fn with_uniform_density(mut self, value: f32) -> Self {
        self.uniform_mask |= UNIFORM_DENSITY;
        self.channel_values[0] = value;
        self
    }

    /// Feed emission from a uniform instead of a texture
    pub fn with_uniform_emission(mut self, value: f32) -> Self {
        self.uniform_mask |= UNIFORM_EMISSION;
        self.channel_values[1] = value;
        self
    }
}
