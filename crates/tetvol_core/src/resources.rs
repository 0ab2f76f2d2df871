//! The resource registry
//!
//! Owns every uniform, texture and attribute buffer the drawables render
//! with. Resources are identified by `(channel name, association)`; the same
//! channel name with the same association always resolves to the same
//! resource, so all drawables bound to a channel see every update to it.

use std::collections::{BTreeMap, HashMap};

use slotmap::{new_key_type, SlotMap};

use crate::backend::{BufferDescriptor, GraphicsBackend, TextureDescriptor};
use crate::channel::{Association, Dtype, RANGE_TRACKED};
use crate::dataset::FieldData;
use crate::error::RenderError;
use crate::range::DataRange;
use crate::texture_shape::TextureShape;
use crate::uniforms::{SceneUniforms, UniformValue};

new_key_type! {
    /// Stable key of a resource in the registry
    pub struct ResourceKey;
}

/// Identity of a resource: channel name plus association
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId {
    pub name: String,
    pub association: Association,
}

impl ResourceId {
    pub fn new(name: impl Into<String>, association: Association) -> Self {
        Self { name: name.into(), association }
    }

    /// Name the shaders bind this resource under (`u_density`, `t_cells`, ...)
    pub fn binding_name(&self) -> String {
        format!("{}{}", self.association.binding_prefix(), self.name)
    }
}

/// Outcome of [`ResourceRegistry::get_or_create`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
    /// The resource did not exist and was just allocated
    Created(ResourceKey),
    /// The resource was already allocated
    Existing(ResourceKey),
}

impl Slot {
    #[inline]
    pub fn key(&self) -> ResourceKey {
        match self {
            Slot::Created(key) | Slot::Existing(key) => *key,
        }
    }

    #[inline]
    pub fn is_created(&self) -> bool {
        matches!(self, Slot::Created(_))
    }
}

/// A packed `f32` data texture with a host-side copy of its contents
pub struct TextureResource<B: GraphicsBackend> {
    pub label: String,
    pub shape: TextureShape,
    pub components: u32,
    /// Element type of the channel, before normalization to `f32`
    pub source_dtype: Dtype,
    texels: Vec<f32>,
    version: u64,
    handle: B::Texture,
}

impl<B: GraphicsBackend> TextureResource<B> {
    /// Create a zero-filled texture on the backend
    pub fn allocate(
        backend: &mut B,
        label: impl Into<String>,
        shape: TextureShape,
        item_size: usize,
        source_dtype: Dtype,
    ) -> Result<Self, RenderError> {
        if !(1..=4).contains(&item_size) {
            return Err(RenderError::UnsupportedItemSize(item_size));
        }
        let label = label.into();
        let desc = TextureDescriptor { label: &label, shape, components: item_size as u32 };
        let handle = backend.create_texture(&desc)?;
        let texels = vec![0.0; desc.value_count()];

        log::debug!(
            "Created texture '{}' for dtype {} and item size {} with shape {}x{}",
            label, source_dtype, item_size, shape.width, shape.height
        );

        Ok(Self { label, shape, components: item_size as u32, source_dtype, texels, version: 0, handle })
    }

    /// Copy `data` into the texture and hand it to the backend
    ///
    /// `data` may be shorter than the texture; the padding keeps its
    /// previous contents. On failure the texture is left untouched.
    pub fn upload(&mut self, backend: &mut B, data: &FieldData) -> Result<(), RenderError> {
        if data.len() > self.texels.len() {
            return Err(RenderError::DataTooLarge {
                channel: self.label.clone(),
                capacity: self.texels.len(),
                actual: data.len(),
            });
        }

        let mut staged = self.texels.clone();
        for (dst, value) in staged.iter_mut().zip(data.iter_f32()) {
            *dst = value;
        }
        backend.write_texture(&mut self.handle, &staged)?;

        self.texels = staged;
        self.version += 1;
        Ok(())
    }

    /// Host copy of the texture contents, padding included
    #[inline]
    pub fn texels(&self) -> &[f32] {
        &self.texels
    }

    /// Number of successful uploads since allocation
    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[inline]
    pub fn handle(&self) -> &B::Texture {
        &self.handle
    }
}

/// A per-instance `f32` attribute buffer
pub struct AttributeResource<B: GraphicsBackend> {
    pub label: String,
    pub item_size: u32,
    pub dynamic: bool,
    data: Vec<f32>,
    version: u64,
    handle: B::Buffer,
}

impl<B: GraphicsBackend> AttributeResource<B> {
    pub fn allocate(
        backend: &mut B,
        label: impl Into<String>,
        item_size: u32,
        dynamic: bool,
        contents: Vec<f32>,
    ) -> Result<Self, RenderError> {
        let label = label.into();
        let desc = BufferDescriptor { label: &label, item_size, dynamic };
        let handle = backend.create_buffer(&desc, &contents)?;
        Ok(Self { label, item_size, dynamic, data: contents, version: 0, handle })
    }

    /// Replace the buffer contents; the length may not change
    pub fn write(&mut self, backend: &mut B, contents: &[f32]) -> Result<(), RenderError> {
        if contents.len() != self.data.len() {
            return Err(RenderError::DataTooLarge {
                channel: self.label.clone(),
                capacity: self.data.len(),
                actual: contents.len(),
            });
        }
        backend.write_buffer(&mut self.handle, contents)?;
        self.data.copy_from_slice(contents);
        self.version += 1;
        Ok(())
    }

    #[inline]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Number of elements (instances) in the buffer
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len() / self.item_size.max(1) as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[inline]
    pub fn handle(&self) -> &B::Buffer {
        &self.handle
    }
}

/// The value backing one channel
pub enum Resource<B: GraphicsBackend> {
    Uniform(UniformValue),
    Texture(TextureResource<B>),
    Attribute(AttributeResource<B>),
}

impl<B: GraphicsBackend> Resource<B> {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Resource::Uniform(_) => "uniform",
            Resource::Texture(_) => "texture",
            Resource::Attribute(_) => "attribute",
        }
    }

    pub fn as_uniform(&self) -> Option<&UniformValue> {
        match self {
            Resource::Uniform(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_texture(&self) -> Option<&TextureResource<B>> {
        match self {
            Resource::Texture(texture) => Some(texture),
            _ => None,
        }
    }

    pub fn as_attribute(&self) -> Option<&AttributeResource<B>> {
        match self {
            Resource::Attribute(attribute) => Some(attribute),
            _ => None,
        }
    }

    /// Push new channel data into the resource
    pub fn update(&mut self, backend: &mut B, channel: &str, data: &FieldData) -> Result<(), RenderError> {
        match self {
            Resource::Uniform(value) => value.set(channel, &data.to_f32_vec()),
            Resource::Texture(texture) => texture.upload(backend, data),
            Resource::Attribute(attribute) => attribute.write(backend, &data.to_f32_vec()),
        }
    }
}

/// Owner of all resources, range tuples and scene uniforms of a renderer
pub struct ResourceRegistry<B: GraphicsBackend> {
    resources: SlotMap<ResourceKey, Resource<B>>,
    index: HashMap<ResourceId, ResourceKey>,
    ranges: BTreeMap<String, DataRange>,
    /// Uniforms shared by every drawable
    pub scene: SceneUniforms,
}

impl<B: GraphicsBackend> Default for ResourceRegistry<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: GraphicsBackend> ResourceRegistry<B> {
    /// Create an empty registry with the default range uniforms declared
    pub fn new() -> Self {
        let ranges = RANGE_TRACKED
            .iter()
            .map(|name| (name.to_string(), DataRange::UNIT))
            .collect();
        Self {
            resources: SlotMap::with_key(),
            index: HashMap::new(),
            ranges,
            scene: SceneUniforms::default(),
        }
    }

    /// Return the resource for `id`, allocating it with `create` if absent
    ///
    /// `create` only runs when the resource does not exist yet.
    pub fn get_or_create<F>(&mut self, id: ResourceId, create: F) -> Result<Slot, RenderError>
    where
        F: FnOnce() -> Result<Resource<B>, RenderError>,
    {
        if let Some(&key) = self.index.get(&id) {
            return Ok(Slot::Existing(key));
        }
        let resource = create()?;
        log::debug!("Allocated {} resource for {}", resource.kind_name(), id.binding_name());
        let key = self.resources.insert(resource);
        self.index.insert(id, key);
        Ok(Slot::Created(key))
    }

    /// Swap the resource stored under `key`, keeping the key stable
    ///
    /// Drawables keep their bindings across a reallocation.
    pub fn replace(&mut self, key: ResourceKey, resource: Resource<B>) -> Option<Resource<B>> {
        self.resources
            .get_mut(key)
            .map(|slot| std::mem::replace(slot, resource))
    }

    pub fn key(&self, name: &str, association: Association) -> Option<ResourceKey> {
        self.index.get(&ResourceId::new(name, association)).copied()
    }

    pub fn contains(&self, name: &str, association: Association) -> bool {
        self.key(name, association).is_some()
    }

    pub fn get(&self, key: ResourceKey) -> Option<&Resource<B>> {
        self.resources.get(key)
    }

    pub fn get_mut(&mut self, key: ResourceKey) -> Option<&mut Resource<B>> {
        self.resources.get_mut(key)
    }

    /// Look up a resource by channel name and association
    pub fn lookup(&self, name: &str, association: Association) -> Option<&Resource<B>> {
        self.key(name, association).and_then(|key| self.resources.get(key))
    }

    /// Texture of a channel under any texture association
    pub fn texture(&self, name: &str) -> Option<&TextureResource<B>> {
        [Association::Vertex, Association::Cell, Association::Lut]
            .into_iter()
            .find_map(|assoc| self.lookup(name, assoc).and_then(Resource::as_texture))
    }

    pub fn uniform(&self, name: &str) -> Option<&UniformValue> {
        self.lookup(name, Association::Uniform).and_then(Resource::as_uniform)
    }

    /// Identifiers of every allocated resource, sorted
    pub fn ids(&self) -> Vec<&ResourceId> {
        let mut ids: Vec<_> = self.index.keys().collect();
        ids.sort();
        ids
    }

    /// Number of allocated resources
    #[inline]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Whether a `u_<channel>_range` uniform exists for `channel`
    pub fn has_range(&self, channel: &str) -> bool {
        self.ranges.contains_key(channel)
    }

    pub fn range(&self, channel: &str) -> Option<DataRange> {
        self.ranges.get(channel).copied()
    }

    /// Store a new range tuple; ignored for channels without a range uniform
    pub fn set_range(&mut self, channel: &str, range: DataRange) -> bool {
        match self.ranges.get_mut(channel) {
            Some(slot) => {
                *slot = range;
                true
            }
            None => false,
        }
    }

    pub fn ranges(&self) -> impl Iterator<Item = (&str, &DataRange)> {
        self.ranges.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostBackend;

    fn texture(backend: &mut HostBackend, shape: TextureShape, item_size: usize) -> Resource<HostBackend> {
        Resource::Texture(
            TextureResource::allocate(backend, "t_test", shape, item_size, Dtype::Float32).unwrap(),
        )
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let mut backend = HostBackend::new();
        let mut registry = ResourceRegistry::<HostBackend>::new();
        let id = ResourceId::new("density", Association::Vertex);

        let first = registry
            .get_or_create(id.clone(), || Ok(texture(&mut backend, TextureShape::new(2, 2), 1)))
            .unwrap();
        assert!(first.is_created());

        let second = registry
            .get_or_create(id, || panic!("must not allocate twice"))
            .unwrap();
        assert_eq!(second, Slot::Existing(first.key()));
        assert_eq!(registry.len(), 1);
        assert_eq!(backend.textures_created(), 1);
    }

    #[test]
    fn test_same_name_different_association() {
        let mut registry = ResourceRegistry::<HostBackend>::new();
        registry
            .get_or_create(ResourceId::new("density", Association::Uniform), || {
                Ok(Resource::Uniform(UniformValue::zeroed(1)?))
            })
            .unwrap();
        assert!(registry.contains("density", Association::Uniform));
        assert!(!registry.contains("density", Association::Vertex));
        assert!(registry.uniform("density").is_some());
        assert!(registry.texture("density").is_none());
    }

    #[test]
    fn test_replace_keeps_key() {
        let mut backend = HostBackend::new();
        let mut registry = ResourceRegistry::<HostBackend>::new();
        let slot = registry
            .get_or_create(ResourceId::new("density_lut", Association::Lut), || {
                Ok(texture(&mut backend, TextureShape::row(4), 1))
            })
            .unwrap();

        let old = registry.replace(slot.key(), texture(&mut backend, TextureShape::row(8), 1));
        assert!(old.is_some());
        let tex = registry.texture("density_lut").unwrap();
        assert_eq!(tex.shape, TextureShape::row(8));
        assert_eq!(registry.key("density_lut", Association::Lut), Some(slot.key()));
    }

    #[test]
    fn test_texture_upload_pads_and_versions() {
        let mut backend = HostBackend::new();
        let mut tex =
            TextureResource::<HostBackend>::allocate(&mut backend, "t_density", TextureShape::new(2, 2), 1, Dtype::Float32)
                .unwrap();
        tex.upload(&mut backend, &FieldData::from(vec![1.0f32, 2.0, 3.0])).unwrap();
        assert_eq!(tex.texels(), &[1.0, 2.0, 3.0, 0.0]);
        assert_eq!(tex.version(), 1);
        assert_eq!(tex.handle().texels, vec![1.0, 2.0, 3.0, 0.0]);
    }

    #[test]
    fn test_texture_upload_too_large() {
        let mut backend = HostBackend::new();
        let mut tex =
            TextureResource::<HostBackend>::allocate(&mut backend, "t_density", TextureShape::new(1, 2), 1, Dtype::Float32)
                .unwrap();
        let err = tex.upload(&mut backend, &FieldData::from(vec![1.0f32; 3])).unwrap_err();
        assert!(matches!(err, RenderError::DataTooLarge { capacity: 2, actual: 3, .. }));
        assert_eq!(tex.version(), 0);
    }

    #[test]
    fn test_integer_data_normalized() {
        let mut backend = HostBackend::new();
        let mut tex =
            TextureResource::<HostBackend>::allocate(&mut backend, "t_cells", TextureShape::new(1, 1), 4, Dtype::Int32)
                .unwrap();
        tex.upload(&mut backend, &FieldData::from(vec![0i32, 1, 2, 3])).unwrap();
        assert_eq!(tex.texels(), &[0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_allocate_rejects_item_size() {
        let mut backend = HostBackend::new();
        let result = TextureResource::<HostBackend>::allocate(
            &mut backend,
            "t_bad",
            TextureShape::new(1, 1),
            5,
            Dtype::Float32,
        );
        assert!(matches!(result, Err(RenderError::UnsupportedItemSize(5))));
    }

    #[test]
    fn test_default_ranges() {
        let mut registry = ResourceRegistry::<HostBackend>::new();
        assert_eq!(registry.range("density"), Some(DataRange::UNIT));
        assert_eq!(registry.range("emission"), Some(DataRange::UNIT));
        assert!(!registry.has_range("coordinates"));
        assert!(!registry.set_range("coordinates", DataRange::UNIT));
    }

    #[test]
    fn test_binding_names() {
        assert_eq!(ResourceId::new("cells", Association::Cell).binding_name(), "t_cells");
        assert_eq!(ResourceId::new("density", Association::Uniform).binding_name(), "u_density");
    }
}
