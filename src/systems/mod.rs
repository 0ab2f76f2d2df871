//! Application systems
//!
//! Rendering, frame stepping and off-screen output used by the binary.

mod animation;
mod offscreen;
mod render;

pub use animation::{AnimationSystem, Frame};
pub use offscreen::{padded_bytes_per_row, staging_size, Image, OffscreenTarget, TARGET_FORMAT};
pub use render::{frame_file_name, RenderError, RenderSystem};
