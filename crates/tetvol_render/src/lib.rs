//! wgpu backend for tetrahedral volume rendering
//!
//! This crate turns the backend-agnostic descriptions of `tetvol_core` into
//! wgpu textures, buffers and render pipelines, and records the draws.
//!
//! ## Key Components
//!
//! - [`context::RenderContext`] - Headless device and queue acquisition
//! - [`backend::WgpuBackend`] - [`GraphicsBackend`](tetvol_core::GraphicsBackend) implementation
//! - [`pipeline`] - Bind group layout, per-method pipelines, uniform block
//! - [`pass::render_drawables`] - Draws configured drawables into a view

pub mod backend;
pub mod context;
pub mod pass;
pub mod pipeline;

pub use backend::{GpuBuffer, GpuGeometry, GpuProgram, GpuTexture, WgpuBackend};
pub use context::{ContextError, RenderContext};
pub use pass::render_drawables;

use tetvol_core::ShaderSources;

/// Vertex stage source, also holding the shared declarations
pub const VERTEX_SHADER: &str = include_str!("shaders/tetra_vertex.wgsl");
/// Fragment stage source
pub const FRAGMENT_SHADER: &str = include_str!("shaders/tetra_fragment.wgsl");

/// The built-in WGSL shader pair
pub fn shader_sources() -> ShaderSources {
    ShaderSources::new(VERTEX_SHADER, FRAGMENT_SHADER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tetvol_core::DefineFlags;

    #[test]
    fn test_every_define_is_an_override() {
        for (name, _) in DefineFlags::NAMES {
            let decl = format!("override {}: bool", name);
            assert!(VERTEX_SHADER.contains(&decl), "missing {}", name);
        }
    }

    #[test]
    fn test_texture_slots_declared() {
        for (i, name) in pipeline::TEXTURE_SLOTS.iter().enumerate() {
            let decl = format!("@binding({}) var {}: texture_2d<f32>", i + 1, name);
            assert!(VERTEX_SHADER.contains(&decl), "missing {}", decl);
        }
    }

    #[test]
    fn test_entry_points() {
        let sources = shader_sources();
        assert!(sources.vertex.contains("fn vs_main"));
        assert!(sources.fragment.contains("fn fs_main"));
    }
}
