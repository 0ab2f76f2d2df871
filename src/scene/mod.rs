//! Scene construction utilities
//!
//! This module builds the synthetic meshes rendered by the demo binary.

mod mesh_builder;

pub use mesh_builder::{MeshBuilder, SyntheticMesh};
