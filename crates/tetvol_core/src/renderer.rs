//! The tetrahedral mesh renderer
//!
//! Ties the pieces together: fixes the mesh extents at `init`, turns a method
//! and an encoding into a drawable at `configure`, and pushes dataset values
//! into the shared resources at `upload`.

use std::collections::BTreeMap;

use crate::allocator::{resolve_bindings, Allocator, Extents, ReconcileMode, ReconcileReport};
use crate::backend::{GraphicsBackend, ShaderSources};
use crate::channel::RANGE_TRACKED;
use crate::config::RendererConfig;
use crate::dataset::Dataset;
use crate::drawable::{ordering_id, Drawable, ORDERING_ATTRIBUTE};
use crate::encoding::Encoding;
use crate::error::RenderError;
use crate::method::Method;
use crate::range::DataRange;
use crate::resources::{AttributeResource, Resource, ResourceKey, ResourceRegistry};
use crate::sort::CellOrdering;
use crate::texture_shape::plan;

/// What the renderer needs to know about the viewer
pub trait CameraView {
    /// Normalized world-space viewing direction
    fn world_direction(&self) -> [f32; 3];

    /// Combined view and projection matrix, column-major
    fn view_projection(&self) -> [[f32; 4]; 4] {
        [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ]
    }
}

/// Maps named data channels of a tetrahedral mesh onto backend resources
/// and keeps one drawable per configured method
pub struct TetrahedralMeshRenderer<B: GraphicsBackend> {
    backend: B,
    shaders: ShaderSources,
    config: RendererConfig,
    registry: ResourceRegistry<B>,
    drawables: BTreeMap<Method, Drawable<B>>,
    extents: Option<Extents>,
    cell_count: usize,
    vertex_count: usize,
    ordering: CellOrdering,
}

impl<B: GraphicsBackend> TetrahedralMeshRenderer<B> {
    pub fn new(backend: B, shaders: ShaderSources, config: RendererConfig) -> Self {
        let mut registry = ResourceRegistry::new();
        registry.scene.constant_color = config.constant_color;
        Self {
            backend,
            shaders,
            config,
            registry,
            drawables: BTreeMap::new(),
            extents: None,
            cell_count: 0,
            vertex_count: 0,
            ordering: CellOrdering::identity(0),
        }
    }

    /// Fix the mesh size and plan the packed texture extents
    ///
    /// May only be called once; the extents stay fixed for the lifetime of
    /// the renderer.
    pub fn init(&mut self, tetrahedron_count: i64, vertex_count: i64) -> Result<(), RenderError> {
        if self.extents.is_some() {
            return Err(RenderError::AlreadyInitialized);
        }
        let extents = Extents { cells: plan(tetrahedron_count)?, vertices: plan(vertex_count)? };
        for (what, count) in [("Tetrahedron", tetrahedron_count), ("Vertex", vertex_count)] {
            if u32::try_from(count).is_err() {
                return Err(RenderError::CountTooLarge { what, count });
            }
        }

        self.cell_count = tetrahedron_count as usize;
        self.vertex_count = vertex_count as usize;
        self.ordering = CellOrdering::identity(self.cell_count);
        self.registry.scene.cell_texture_shape = extents.cells;
        self.registry.scene.vertex_texture_shape = extents.vertices;
        self.extents = Some(extents);

        log::info!(
            "Initialized for {} tetrahedra ({}x{} cell texture) and {} vertices ({}x{} vertex texture)",
            tetrahedron_count,
            extents.cells.width,
            extents.cells.height,
            vertex_count,
            extents.vertices.width,
            extents.vertices.height
        );
        Ok(())
    }

    /// Build the drawable for `method`
    ///
    /// Without an encoding the method's default is used. Configuring a method
    /// again replaces its drawable and encoding; resources allocated earlier
    /// are reused.
    pub fn configure(&mut self, method: Method, encoding: Option<Encoding>) -> Result<(), RenderError> {
        let extents = self.extents.ok_or(RenderError::NotInitialized)?;
        let props = method.properties();
        let encoding = encoding.unwrap_or_else(|| props.default_encoding());

        let (plan, skipped) = resolve_bindings(&encoding, props.channels);
        if !skipped.is_empty() {
            log::debug!("{} channels left out of {} configuration", skipped.len(), method);
        }

        let report = Allocator::new(&mut self.backend, &mut self.registry, extents)
            .reconcile(&plan, None, ReconcileMode::ALLOCATE)?;
        log::debug!("Configure {} allocated {} resources", method, report.allocated.len());

        let ordering = self.ensure_ordering()?;
        let drawable = Drawable::assemble(
            &mut self.backend,
            &self.shaders,
            method,
            encoding,
            plan,
            &self.registry,
            ordering,
            // Fits, init rejects larger counts
            self.cell_count as u32,
        )?;

        if self.drawables.insert(method, drawable).is_some() {
            log::info!("Reconfigured method {}", method);
        } else {
            log::info!("Configured method {}", method);
        }
        Ok(())
    }

    /// Push the fields of `dataset` into the resources of a configured method
    ///
    /// Channels that cannot be updated are logged and skipped; the returned
    /// report lists what happened to each.
    pub fn upload(&mut self, dataset: &Dataset, method: Method) -> Result<ReconcileReport, RenderError> {
        let extents = self.extents.ok_or(RenderError::NotInitialized)?;
        let drawable = self
            .drawables
            .get(&method)
            .ok_or(RenderError::MethodNotConfigured(method))?;

        let mode = ReconcileMode::update(self.config.allocate_on_update);
        let report = Allocator::new(&mut self.backend, &mut self.registry, extents)
            .reconcile(&drawable.plan, Some(dataset), mode)?;

        // Uploads may allocate resources that drawables have not bound yet
        if !report.allocated.is_empty() {
            for drawable in self.drawables.values_mut() {
                drawable.rebind(&self.registry);
            }
        }

        log::debug!(
            "Uploaded {} channels for {}, skipped {}",
            report.updated.len(),
            method,
            report.skipped.len()
        );
        Ok(report)
    }

    /// Take the view direction and projection from `camera`
    ///
    /// With sorting enabled and a sorted method configured, cells are
    /// re-sorted along the new view direction.
    pub fn update_perspective(&mut self, camera: &impl CameraView) {
        let direction = camera.world_direction();
        self.registry.scene.view_direction = direction;
        self.registry.scene.view_projection = camera.view_projection();

        if self.config.sort_cells && self.needs_sorting() {
            self.sort_cells(direction);
        }
    }

    /// Advance the animation clock and its oscillators
    pub fn update_time(&mut self, time: f32) {
        self.registry.scene.set_time(time);
    }

    /// Recompute the range uniforms from fields named after their channels
    pub fn update_ranges(&mut self, dataset: &Dataset) {
        for channel in RANGE_TRACKED {
            let Some(data) = dataset.get(channel) else {
                continue;
            };
            if let Some(range) = DataRange::compute(data.iter_f32()) {
                self.registry.set_range(channel, range);
            }
        }
        log::info!(
            "Updated data ranges: {:?}",
            self.registry.ranges().map(|(name, r)| (name, r.to_array())).collect::<Vec<_>>()
        );
    }

    /// Allocate the shared ordering attribute on first use
    fn ensure_ordering(&mut self) -> Result<ResourceKey, RenderError> {
        let backend = &mut self.backend;
        let ordering = &self.ordering;
        let slot = self.registry.get_or_create(ordering_id(), || {
            Ok(Resource::Attribute(AttributeResource::allocate(
                backend,
                ORDERING_ATTRIBUTE,
                1,
                true,
                ordering.as_f32(),
            )?))
        })?;
        Ok(slot.key())
    }

    fn needs_sorting(&self) -> bool {
        self.drawables.keys().any(|method| method.properties().sorted)
    }

    fn sort_cells(&mut self, direction: [f32; 3]) {
        let (Some(cells), Some(coords)) = (self.registry.texture("cells"), self.registry.texture("coordinates"))
        else {
            log::debug!("Cells or coordinates missing, keeping current ordering");
            return;
        };
        self.ordering.reorder(cells.texels(), coords.texels(), coords.components as usize, direction);

        let values = self.ordering.as_f32();
        let Some(key) = self.registry.key(&ordering_id().name, ordering_id().association) else {
            return;
        };
        if let Some(Resource::Attribute(attribute)) = self.registry.get_mut(key) {
            if let Err(err) = attribute.write(&mut self.backend, &values) {
                log::error!("Failed to write cell ordering: {}", err);
            }
        }
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.extents.is_some()
    }

    /// Packed cell and vertex texture extents, once initialized
    #[inline]
    pub fn texture_shapes(&self) -> Option<Extents> {
        self.extents
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.cell_count
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn drawable(&self, method: Method) -> Option<&Drawable<B>> {
        self.drawables.get(&method)
    }

    /// Configured drawables in method order
    pub fn drawables(&self) -> impl Iterator<Item = &Drawable<B>> {
        self.drawables.values()
    }

    #[inline]
    pub fn registry(&self) -> &ResourceRegistry<B> {
        &self.registry
    }

    #[inline]
    pub fn ordering(&self) -> &CellOrdering {
        &self.ordering
    }

    #[inline]
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[inline]
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Backend and registry together, for recording draws
    pub fn parts_mut(&mut self) -> (&mut B, &ResourceRegistry<B>, &BTreeMap<Method, Drawable<B>>) {
        (&mut self.backend, &self.registry, &self.drawables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostBackend;

    struct Looking([f32; 3]);

    impl CameraView for Looking {
        fn world_direction(&self) -> [f32; 3] {
            self.0
        }
    }

    fn renderer() -> TetrahedralMeshRenderer<HostBackend> {
        TetrahedralMeshRenderer::new(HostBackend::new(), ShaderSources::new("vs", "fs"), RendererConfig::default())
    }

    #[test]
    fn test_init_rejects_bad_counts() {
        let mut r = renderer();
        assert!(matches!(r.init(0, 4), Err(RenderError::Shape(_))));
        assert!(matches!(r.init(4, -1), Err(RenderError::Shape(_))));
        assert!(!r.is_initialized());
    }

    #[test]
    fn test_init_rejects_counts_beyond_u32() {
        let mut r = renderer();
        let too_many = u32::MAX as i64 + 1;
        assert_eq!(
            r.init(too_many, 4),
            Err(RenderError::CountTooLarge { what: "Tetrahedron", count: too_many })
        );
        assert_eq!(
            r.init(4, too_many),
            Err(RenderError::CountTooLarge { what: "Vertex", count: too_many })
        );
        assert!(!r.is_initialized());
        assert!(r.ordering().is_empty());
    }

    #[test]
    fn test_init_twice() {
        let mut r = renderer();
        r.init(10, 20).unwrap();
        assert_eq!(r.init(10, 20), Err(RenderError::AlreadyInitialized));
    }

    #[test]
    fn test_configure_before_init() {
        let mut r = renderer();
        assert_eq!(r.configure(Method::Surface, None), Err(RenderError::NotInitialized));
    }

    #[test]
    fn test_update_time() {
        let mut r = renderer();
        r.update_time(1.0);
        assert_eq!(r.registry().scene.time, 1.0);
        assert!(r.registry().scene.oscillators[0].abs() < 1e-5);
    }

    #[test]
    fn test_update_perspective_sets_direction() {
        let mut r = renderer();
        r.update_perspective(&Looking([1.0, 0.0, 0.0]));
        assert_eq!(r.registry().scene.view_direction, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_update_ranges() {
        let mut r = renderer();
        let data = Dataset::new()
            .with_field("density", vec![1.0f32, 3.0, 2.0])
            .with_field("coordinates", vec![5.0f32]);
        r.update_ranges(&data);
        assert_eq!(r.registry().range("density").unwrap().to_array(), [1.0, 3.0, 2.0, 0.5]);
        assert_eq!(r.registry().range("emission"), Some(DataRange::UNIT));
    }
}
