//! Rendering pipeline components
//!
//! This module contains the pipeline layout, per-method render pipelines and
//! the uniform block shared with the shaders.

pub mod mesh_pipeline;
pub mod types;

pub use mesh_pipeline::{
    blend_state, create_mesh_pipeline, cull_mode, override_constants, texture_format,
    vertex_buffer_layouts, MeshLayout, MeshPipelineDescriptor, TEXTURE_SLOTS,
};
pub use types::{MeshUniforms, UNIFORM_DENSITY, UNIFORM_EMISSION};
