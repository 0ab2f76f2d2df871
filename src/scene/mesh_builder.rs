//! MeshBuilder - Synthetic tetrahedral meshes
//!
//! Builds a cube of `resolution³` cells, each split into six tetrahedra,
//! with a smooth density blob, an emission field and matching lookup tables.

use tetvol_core::Dataset;

/// Cube corners of the six tetrahedra sharing the (0,0,0)-(1,1,1) diagonal
///
/// Corner `i` sits at `(i & 1, (i >> 1) & 1, (i >> 2) & 1)`.
const CUBE_TETRAHEDRA: [[usize; 4]; 6] = [
    [0, 1, 3, 7],
    [0, 1, 5, 7],
    [0, 2, 3, 7],
    [0, 2, 6, 7],
    [0, 4, 5, 7],
    [0, 4, 6, 7],
];

/// A generated mesh and the counts the renderer is initialized with
#[derive(Debug, Clone)]
pub struct SyntheticMesh {
    pub dataset: Dataset,
    pub cell_count: usize,
    pub vertex_count: usize,
}

/// Builder for synthetic volume meshes
///
/// # Example
/// ```ignore
/// let mesh = MeshBuilder::new(8)
///     .with_lut_size(64)
///     .with_blob_width(0.3)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct MeshBuilder {
    resolution: u32,
    lut_size: u32,
    extent: f32,
    blob_width: f32,
}

impl MeshBuilder {
    /// Create a builder for `resolution` cubes along each axis
    pub fn new(resolution: u32) -> Self {
        Self {
            resolution,
            lut_size: 64,
            extent: 1.0,
            blob_width: 0.35,
        }
    }

    /// Number of entries in both lookup tables
    pub fn with_lut_size(mut self, lut_size: u32) -> Self {
        self.lut_size = lut_size;
        self
    }

    /// Edge length of the whole cube, centered on the origin
    pub fn with_extent(mut self, extent: f32) -> Self {
        self.extent = extent;
        self
    }

    /// Standard deviation of the density blob, relative to the extent
    pub fn with_blob_width(mut self, blob_width: f32) -> Self {
        self.blob_width = blob_width;
        self
    }

    /// Generate vertices, cells, fields and lookup tables
    pub fn build(&self) -> SyntheticMesh {
        let n = self.resolution as usize;
        let side = n + 1;
        let vertex_count = if n == 0 { 0 } else { side * side * side };
        let cell_count = n * n * n * CUBE_TETRAHEDRA.len();

        let step = if n == 0 { 0.0 } else { self.extent / n as f32 };
        let half = self.extent / 2.0;
        let sigma = (self.blob_width * self.extent).max(f32::EPSILON);

        let mut coordinates = Vec::with_capacity(vertex_count * 3);
        let mut density = Vec::with_capacity(vertex_count);
        let mut emission = Vec::with_capacity(vertex_count);
        for k in 0..side.min(vertex_count) {
            for j in 0..side {
                for i in 0..side {
                    let p = [
                        i as f32 * step - half,
                        j as f32 * step - half,
                        k as f32 * step - half,
                    ];
                    let r2 = p[0] * p[0] + p[1] * p[1] + p[2] * p[2];
                    coordinates.extend_from_slice(&p);
                    density.push((-r2 / (2.0 * sigma * sigma)).exp());
                    // Height gradient with a ripple, so emission differs from density
                    emission.push((p[1] / self.extent + 0.5) + 0.1 * (6.0 * p[0] / self.extent).sin());
                }
            }
        }

        let vertex = |i: usize, j: usize, k: usize| (k * side + j) * side + i;
        let mut cells: Vec<i32> = Vec::with_capacity(cell_count * 4);
        for k in 0..n {
            for j in 0..n {
                for i in 0..n {
                    let corners: [usize; 8] = std::array::from_fn(|c| {
                        vertex(i + (c & 1), j + ((c >> 1) & 1), k + ((c >> 2) & 1))
                    });
                    for tet in &CUBE_TETRAHEDRA {
                        cells.extend(tet.iter().map(|&c| corners[c] as i32));
                    }
                }
            }
        }

        let dataset = Dataset::new()
            .with_field("coordinates", coordinates)
            .with_field("cells", cells)
            .with_field("density", density)
            .with_field("emission", emission)
            .with_field("density_lut", density_lut(self.lut_size, 4.0 / self.extent))
            .with_field("emission_lut", emission_lut(self.lut_size));

        log::debug!(
            "Built synthetic mesh: {} cells, {} vertices, {} LUT entries",
            cell_count,
            vertex_count,
            self.lut_size
        );

        SyntheticMesh { dataset, cell_count, vertex_count }
    }
}

/// Extinction ramp from 0 to `max_extinction`
fn density_lut(size: u32, max_extinction: f32) -> Vec<f32> {
    let last = size.saturating_sub(1).max(1) as f32;
    (0..size).map(|i| max_extinction * (i as f32 / last).powi(2)).collect()
}

/// Blue to orange RGB color ramp
fn emission_lut(size: u32) -> Vec<f32> {
    let last = size.saturating_sub(1).max(1) as f32;
    (0..size)
        .flat_map(|i| {
            let t = i as f32 / last;
            [t, 0.2 + 0.5 * t * (1.0 - t) * 2.0, 1.0 - t]
        })
        .collect()
}
