//! Renderer behavior switches

use serde::{Deserialize, Serialize};

/// Tunables of a [`TetrahedralMeshRenderer`](crate::TetrahedralMeshRenderer)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Re-sort cells on every perspective update when a sorted method is configured
    pub sort_cells: bool,
    /// Let uploads allocate resources that configure did not create
    pub allocate_on_update: bool,
    /// Color used by methods without an emission lookup
    pub constant_color: [f32; 3],
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            sort_cells: false,
            allocate_on_update: true,
            constant_color: [0.8, 0.8, 0.8],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RendererConfig::default();
        assert!(!config.sort_cells);
        assert!(config.allocate_on_update);
        assert_eq!(config.constant_color, [0.8, 0.8, 0.8]);
    }
}
