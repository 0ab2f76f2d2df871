//! tetvol - Tetrahedral volume mesh renderer
//!
//! Application layer over [`tetvol_core`] and [`tetvol_render`]: layered
//! configuration, synthetic meshes, an orbit camera and a headless render
//! system that writes one image per method.

pub mod camera;
pub mod config;
pub mod scene;
pub mod systems;
