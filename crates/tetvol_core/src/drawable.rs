//! Drawable assembly
//!
//! Each tetrahedron is drawn as one instance of a 6-index triangle strip over
//! its four local vertices. Per-vertex attributes rotate the local vertex
//! indices so every vertex sees the other three, and a per-instance ordering
//! attribute picks the cell the instance draws.

use crate::allocator::ChannelBinding;
use crate::backend::{GeometryDescriptor, GraphicsBackend, ProgramDescriptor, ShaderSources};
use crate::channel::Association;
use crate::encoding::Encoding;
use crate::error::RenderError;
use crate::method::{DefineFlags, Method};
use crate::resources::{ResourceId, ResourceKey, ResourceRegistry};

/// Strip covering all four faces of a tetrahedron
pub const STRIP_INDICES: [u16; 6] = [0, 1, 2, 3, 0, 1];

/// Local vertex id of each strip vertex
pub const VERTEX_IDS: [f32; 4] = [0.0, 1.0, 2.0, 3.0];

/// Rotations of the local vertex indices, four per vertex
pub const LOCAL_VERTICES: [f32; 16] = [
    0.0, 1.0, 2.0, 3.0, //
    1.0, 2.0, 3.0, 0.0, //
    2.0, 3.0, 0.0, 1.0, //
    3.0, 0.0, 1.0, 2.0,
];

/// Label of the shared per-instance ordering attribute
pub const ORDERING_ATTRIBUTE: &str = "c_ordering";

/// Registry identity of the ordering attribute
pub fn ordering_id() -> ResourceId {
    ResourceId::new("ordering", Association::Cell)
}

/// One resource bound to a drawable under its shader binding name
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    pub key: ResourceKey,
}

/// A renderable object for one configured method
pub struct Drawable<B: GraphicsBackend> {
    pub method: Method,
    pub encoding: Encoding,
    pub defines: DefineFlags,
    /// Channel plan replayed by every upload
    pub plan: Vec<ChannelBinding>,
    pub bindings: Vec<Binding>,
    pub ordering: ResourceKey,
    pub instance_count: u32,
    pub program: B::Program,
    pub geometry: B::Geometry,
}

impl<B: GraphicsBackend> Drawable<B> {
    /// Build the program and geometry for `method` and bind the resources of
    /// `plan` that exist in `registry`
    #[allow(clippy::too_many_arguments)]
    pub fn assemble(
        backend: &mut B,
        shaders: &ShaderSources,
        method: Method,
        encoding: Encoding,
        plan: Vec<ChannelBinding>,
        registry: &ResourceRegistry<B>,
        ordering: ResourceKey,
        instance_count: u32,
    ) -> Result<Self, RenderError> {
        let props = method.properties();
        let defines = props.effective_defines();
        let label = format!("tetvol_{}", method);

        let program = backend.create_program(&ProgramDescriptor {
            label: &label,
            shaders,
            defines,
            transparent: props.transparent,
            blend: props.blend,
            side: props.side,
            depth_test: false,
            depth_write: false,
        })?;

        let geometry = backend.create_geometry(&GeometryDescriptor {
            label: &label,
            strip_indices: &STRIP_INDICES,
            local_vertices: &LOCAL_VERTICES,
            vertex_ids: &VERTEX_IDS,
            instance_count,
        })?;

        let mut drawable = Self {
            method,
            encoding,
            defines,
            plan,
            bindings: Vec::new(),
            ordering,
            instance_count,
            program,
            geometry,
        };
        drawable.rebind(registry);

        log::info!(
            "Assembled {} drawable with {} bindings, defines [{}]",
            method,
            drawable.bindings.len(),
            defines.define_names().collect::<Vec<_>>().join(", ")
        );
        Ok(drawable)
    }

    /// Refresh the bindings from the resources currently in `registry`
    pub fn rebind(&mut self, registry: &ResourceRegistry<B>) {
        self.bindings = self
            .plan
            .iter()
            .filter_map(|binding| {
                let id = binding.resource_id();
                let key = registry.key(&id.name, id.association)?;
                Some(Binding { name: id.binding_name(), key })
            })
            .collect();
    }

    /// Key of the resource bound under `name`
    pub fn binding(&self, name: &str) -> Option<ResourceKey> {
        self.bindings.iter().find(|b| b.name == name).map(|b| b.key)
    }

    pub fn binding_names(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|b| b.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::{resolve_bindings, Allocator, Extents, ReconcileMode};
    use crate::host::HostBackend;
    use crate::method::Side;
    use crate::resources::{AttributeResource, Resource};
    use crate::texture_shape::plan;

    fn build(method: Method) -> (HostBackend, ResourceRegistry<HostBackend>, Drawable<HostBackend>) {
        let mut backend = HostBackend::new();
        let mut registry = ResourceRegistry::new();
        let encoding = method.properties().default_encoding();
        let (bindings, _) = resolve_bindings(&encoding, method.properties().channels);
        let extents = Extents { cells: plan(2).unwrap(), vertices: plan(8).unwrap() };
        Allocator::new(&mut backend, &mut registry, extents)
            .reconcile(&bindings, None, ReconcileMode::ALLOCATE)
            .unwrap();
        let ordering = registry
            .get_or_create(ordering_id(), || {
                Ok(Resource::Attribute(AttributeResource::allocate(&mut backend, ORDERING_ATTRIBUTE, 1, true, vec![0.0, 1.0])?))
            })
            .unwrap()
            .key();
        let shaders = ShaderSources::new("vs", "fs");
        let drawable =
            Drawable::assemble(&mut backend, &shaders, method, encoding, bindings, &registry, ordering, 2).unwrap();
        (backend, registry, drawable)
    }

    #[test]
    fn test_rotation_pattern() {
        for (v, rot) in LOCAL_VERTICES.chunks(4).enumerate() {
            for (k, &local) in rot.iter().enumerate() {
                assert_eq!(local as usize, (v + k) % 4);
            }
        }
    }

    #[test]
    fn test_surface_drawable() {
        let (backend, registry, drawable) = build(Method::Surface);
        assert_eq!(backend.programs_created(), 1);
        assert!(!drawable.program.transparent);
        assert!(!drawable.program.depth_test);
        assert!(!drawable.program.depth_write);
        assert_eq!(drawable.program.side, Side::Double);
        assert_eq!(drawable.geometry.strip_indices, STRIP_INDICES.to_vec());
        assert_eq!(drawable.geometry.instance_count, 2);
        assert!(drawable.defines.contains(DefineFlags::ENABLE_CELL_ORDERING | DefineFlags::ENABLE_SURFACE_MODEL));

        let names: Vec<_> = drawable.binding_names().collect();
        assert!(names.contains(&"t_cells"));
        assert!(names.contains(&"t_density_lut"));
        assert_eq!(drawable.binding("t_cells"), registry.key("cells", Association::Cell));
    }

    #[test]
    fn test_cloud_blending() {
        let (_, _, drawable) = build(Method::Cloud);
        assert!(drawable.program.transparent);
        assert_eq!(drawable.program.side, Side::Back);
        assert_eq!(drawable.program.blend, Method::Cloud.properties().blend);
        assert!(drawable.defines.contains(DefineFlags::ENABLE_DENSITY | DefineFlags::ENABLE_EMISSION));
    }
}
