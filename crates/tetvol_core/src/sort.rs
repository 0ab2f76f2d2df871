//! View-dependent ordering of tetrahedra
//!
//! Translucent methods blend in instance order. The ordering attribute holds a
//! permutation of cell indices that the vertex shader uses to pick which cell
//! each instance draws.

/// A permutation of `0..cell_count`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellOrdering {
    indices: Vec<u32>,
}

impl CellOrdering {
    /// Identity permutation
    ///
    /// `cell_count` must fit in `u32`; the renderer checks this in `init`.
    pub fn identity(cell_count: usize) -> Self {
        Self { indices: (0..cell_count as u32).collect() }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    #[inline]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Values for the `f32` instance attribute
    pub fn as_f32(&self) -> Vec<f32> {
        self.indices.iter().map(|&i| i as f32).collect()
    }

    /// Sort cells by their nearest vertex along `view_direction`
    ///
    /// `cells` holds four vertex indices per cell and `coordinates` holds
    /// `coord_stride` values per vertex, the first three being the position.
    /// Cells with out-of-range vertex indices sort last. The sort is stable,
    /// so ties keep their previous relative order.
    pub fn reorder(&mut self, cells: &[f32], coordinates: &[f32], coord_stride: usize, view_direction: [f32; 3]) {
        let stride = coord_stride.max(3);
        let vertex_count = coordinates.len() / stride;

        let depth = |vertex: f32| -> Option<f32> {
            let v = vertex as usize;
            if vertex < 0.0 || v >= vertex_count {
                return None;
            }
            let p = &coordinates[v * stride..v * stride + 3];
            Some(p[0] * view_direction[0] + p[1] * view_direction[1] + p[2] * view_direction[2])
        };

        let keys: Vec<f32> = (0..self.indices.len())
            .map(|cell| {
                cells
                    .get(cell * 4..cell * 4 + 4)
                    .and_then(|verts| {
                        verts
                            .iter()
                            .map(|&v| depth(v))
                            .try_fold(f32::INFINITY, |acc, d| d.map(|d| acc.min(d)))
                    })
                    .unwrap_or(f32::INFINITY)
            })
            .collect();

        self.indices.sort_by(|&a, &b| keys[a as usize].total_cmp(&keys[b as usize]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_permutation(ordering: &CellOrdering) -> bool {
        let mut sorted = ordering.indices().to_vec();
        sorted.sort_unstable();
        sorted.iter().enumerate().all(|(i, &v)| i as u32 == v)
    }

    /// Three tetrahedra stacked along z
    fn stacked() -> (Vec<f32>, Vec<f32>) {
        let mut coords = Vec::new();
        for z in [2.0f32, 0.0, 1.0] {
            coords.extend_from_slice(&[0.0, 0.0, z, 1.0, 0.0, z, 0.0, 1.0, z, 0.0, 0.0, z + 0.5]);
        }
        let cells: Vec<f32> = (0..12).map(|i| i as f32).collect();
        (cells, coords)
    }

    #[test]
    fn test_identity() {
        let ordering = CellOrdering::identity(4);
        assert_eq!(ordering.indices(), &[0, 1, 2, 3]);
        assert_eq!(ordering.as_f32(), vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_reorder_along_view() {
        let (cells, coords) = stacked();
        let mut ordering = CellOrdering::identity(3);
        ordering.reorder(&cells, &coords, 3, [0.0, 0.0, 1.0]);
        assert_eq!(ordering.indices(), &[1, 2, 0]);

        ordering.reorder(&cells, &coords, 3, [0.0, 0.0, -1.0]);
        assert_eq!(ordering.indices(), &[0, 2, 1]);
        assert!(is_permutation(&ordering));
    }

    #[test]
    fn test_reorder_perpendicular_view_is_stable() {
        let (cells, coords) = stacked();
        let mut ordering = CellOrdering::identity(3);
        ordering.reorder(&cells, &coords, 3, [0.0, 1.0, 0.0]);
        assert_eq!(ordering.indices(), &[0, 1, 2]);
    }

    #[test]
    fn test_reorder_bad_indices_sort_last() {
        let (mut cells, coords) = stacked();
        cells[0] = 99.0;
        let mut ordering = CellOrdering::identity(3);
        ordering.reorder(&cells, &coords, 3, [0.0, 0.0, 1.0]);
        assert_eq!(ordering.indices(), &[1, 2, 0]);

        // Short cell buffer
        let mut ordering = CellOrdering::identity(4);
        ordering.reorder(&cells, &coords, 3, [0.0, 0.0, 1.0]);
        assert_eq!(ordering.indices()[3], 3);
        assert!(is_permutation(&ordering));
    }

    #[test]
    fn test_reorder_padded_stride() {
        let (cells, coords) = stacked();
        let padded: Vec<f32> = coords.chunks(3).flat_map(|p| [p[0], p[1], p[2], 0.0]).collect();
        let mut ordering = CellOrdering::identity(3);
        ordering.reorder(&cells, &padded, 4, [0.0, 0.0, 1.0]);
        assert_eq!(ordering.indices(), &[1, 2, 0]);
    }
}
