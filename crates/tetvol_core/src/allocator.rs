//! Allocation and update of channel resources
//!
//! An encoding is resolved against a method's channel set once, at configure
//! time, into a list of [`ChannelBinding`]s. Every later pass replays that
//! list: allocate-only when a method is configured, update-only when data is
//! uploaded. Problems with one channel are logged and skip that channel only.

use std::fmt;

use crate::backend::GraphicsBackend;
use crate::channel::{Association, Channel, ChannelSet};
use crate::dataset::{Dataset, FieldData};
use crate::encoding::Encoding;
use crate::error::RenderError;
use crate::range::DataRange;
use crate::resources::{Resource, ResourceId, ResourceKey, ResourceRegistry, TextureResource};
use crate::texture_shape::TextureShape;
use crate::uniforms::UniformValue;

/// A channel resolved against an encoding: where its data comes from and
/// what kind of resource backs it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelBinding {
    pub channel: &'static Channel,
    pub field: String,
    pub association: Association,
}

impl ChannelBinding {
    pub fn resource_id(&self) -> ResourceId {
        ResourceId::new(self.channel.name, self.association)
    }
}

/// Why a channel was left out of a pass
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// The encoding has no entry for the channel
    MissingEncoding,
    /// The encoding names a channel the method does not declare
    UnknownChannel,
    /// The encoding overrides the association with an unknown name
    UnknownAssociation(String),
    /// The dataset lacks the encoded field
    MissingField(String),
    /// The field has no values
    EmptyData,
    /// Update-only pass found no resource and may not allocate
    NotAllocated,
    /// Allocating or writing the resource failed
    Failed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingEncoding => write!(f, "no encoding entry"),
            SkipReason::UnknownChannel => write!(f, "channel is missing a description"),
            SkipReason::UnknownAssociation(name) => write!(f, "unknown association '{}'", name),
            SkipReason::MissingField(field) => write!(f, "no data found for field '{}'", field),
            SkipReason::EmptyData => write!(f, "field is empty"),
            SkipReason::NotAllocated => write!(f, "resource not allocated"),
            SkipReason::Failed(msg) => write!(f, "{}", msg),
        }
    }
}

/// Resolve `encoding` against `channels`
///
/// Channels without an encoding entry, encoding entries for unknown channels,
/// and unknown association overrides are logged and left out; the returned
/// skip list records them.
pub fn resolve_bindings(
    encoding: &Encoding,
    channels: &ChannelSet,
) -> (Vec<ChannelBinding>, Vec<(String, SkipReason)>) {
    let mut bindings = Vec::with_capacity(channels.len());
    let mut skipped = Vec::new();

    for (name, _) in encoding.iter() {
        if channels.get(name).is_none() {
            log::warn!("Channel {} is missing description.", name);
            skipped.push((name.to_string(), SkipReason::UnknownChannel));
        }
    }

    for channel in channels.iter() {
        let Some(entry) = encoding.get(channel.name) else {
            log::info!("No encoding found for channel {}.", channel.name);
            skipped.push((channel.name.to_string(), SkipReason::MissingEncoding));
            continue;
        };

        match entry.resolve_association(channel.association) {
            Ok(association) => bindings.push(ChannelBinding {
                channel,
                field: entry.field.clone(),
                association,
            }),
            Err(err) => {
                log::warn!("Skipping channel {}: {}", channel.name, err);
                skipped.push((channel.name.to_string(), SkipReason::UnknownAssociation(err.0)));
            }
        }
    }

    (bindings, skipped)
}

/// Packed extents fixed at `init`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Extents {
    pub cells: TextureShape,
    pub vertices: TextureShape,
}

/// What a reconcile pass may do
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReconcileMode {
    /// Allocate missing resources without data
    pub allocate: bool,
    /// Push dataset values into resources
    pub update: bool,
    /// Allow an update pass to allocate resources that do not exist yet
    pub allocate_on_update: bool,
}

impl ReconcileMode {
    /// Configure-time pass
    pub const ALLOCATE: Self = Self { allocate: true, update: false, allocate_on_update: false };

    /// Upload-time pass
    pub const fn update(allocate_on_update: bool) -> Self {
        Self { allocate: false, update: true, allocate_on_update }
    }

    #[inline]
    fn may_allocate(&self) -> bool {
        self.allocate || self.allocate_on_update
    }
}

/// Summary of one reconcile pass
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Resources created (or reallocated) during the pass
    pub allocated: Vec<ResourceId>,
    /// Channels whose resource received new data
    pub updated: Vec<String>,
    /// Channels whose range tuple was recomputed
    pub ranged: Vec<String>,
    pub skipped: Vec<(String, SkipReason)>,
}

impl ReconcileReport {
    pub fn was_updated(&self, channel: &str) -> bool {
        self.updated.iter().any(|c| c == channel)
    }

    pub fn was_skipped(&self, channel: &str) -> bool {
        self.skipped.iter().any(|(c, _)| c == channel)
    }
}

/// Allocates and refreshes the resources of a set of channel bindings
pub struct Allocator<'a, B: GraphicsBackend> {
    backend: &'a mut B,
    registry: &'a mut ResourceRegistry<B>,
    extents: Extents,
}

impl<'a, B: GraphicsBackend> Allocator<'a, B> {
    pub fn new(backend: &'a mut B, registry: &'a mut ResourceRegistry<B>, extents: Extents) -> Self {
        Self { backend, registry, extents }
    }

    /// Run one pass over `bindings`
    ///
    /// Only configuration-time failures are returned as errors: an
    /// unsupported item size, or a backend refusing to create a resource
    /// while allocating. Everything else skips the channel.
    pub fn reconcile(
        &mut self,
        bindings: &[ChannelBinding],
        dataset: Option<&Dataset>,
        mode: ReconcileMode,
    ) -> Result<ReconcileReport, RenderError> {
        let mut report = ReconcileReport::default();

        for binding in bindings {
            let name = binding.channel.name;
            log::debug!("Processing channel {} ({})", name, binding.association);

            let data = match dataset {
                Some(dataset) => match dataset.get(&binding.field) {
                    Some(data) => Some(data),
                    None => {
                        log::info!(
                            "No data found for field {} encoded for channel {}.",
                            binding.field, name
                        );
                        report.skipped.push((name.to_string(), SkipReason::MissingField(binding.field.clone())));
                        continue;
                    }
                },
                None => None,
            };

            if data.is_none() && !mode.allocate {
                continue;
            }

            let key = match self.ensure_resource(binding, data, mode, &mut report) {
                Ok(Some(key)) => key,
                Ok(None) => continue,
                Err(err) if is_fatal(&err, mode) => return Err(err),
                Err(err) => {
                    log::error!("Failed to allocate resource for {}: {}", name, err);
                    report.skipped.push((name.to_string(), SkipReason::Failed(err.to_string())));
                    continue;
                }
            };

            let Some(data) = data.filter(|_| mode.update) else {
                continue;
            };

            let Some(resource) = self.registry.get_mut(key) else {
                continue;
            };
            if let Err(err) = resource.update(self.backend, name, data) {
                log::error!("Failed to update {} for channel {}: {}", resource.kind_name(), name, err);
                report.skipped.push((name.to_string(), SkipReason::Failed(err.to_string())));
                continue;
            }
            log::debug!("Updated {} for channel {}", resource.kind_name(), name);
            report.updated.push(name.to_string());

            if self.registry.has_range(name) {
                if let Some(range) = DataRange::compute(data.iter_f32()) {
                    self.registry.set_range(name, range);
                    log::debug!("Updated data range for {}: {:?}", name, range.to_array());
                    report.ranged.push(name.to_string());
                }
            }
        }

        Ok(report)
    }

    /// Find or allocate the resource for `binding`
    ///
    /// `Ok(None)` means the channel was skipped and recorded in `report`.
    fn ensure_resource(
        &mut self,
        binding: &ChannelBinding,
        data: Option<&FieldData>,
        mode: ReconcileMode,
        report: &mut ReconcileReport,
    ) -> Result<Option<ResourceKey>, RenderError> {
        let channel = binding.channel;
        let id = binding.resource_id();
        let existing = self.registry.key(channel.name, binding.association);

        if existing.is_none() && !mode.may_allocate() {
            log::warn!("No {} resource allocated for channel {}, skipping.", binding.association, channel.name);
            report.skipped.push((channel.name.to_string(), SkipReason::NotAllocated));
            return Ok(None);
        }

        let backend = &mut *self.backend;
        let slot = match binding.association {
            Association::Uniform => self.registry.get_or_create(id.clone(), || {
                Ok(Resource::Uniform(UniformValue::zeroed(channel.item_size)?))
            })?,
            Association::Vertex | Association::Cell => {
                let shape = if binding.association == Association::Vertex {
                    self.extents.vertices
                } else {
                    self.extents.cells
                };
                self.registry.get_or_create(id.clone(), || {
                    Ok(Resource::Texture(TextureResource::allocate(
                        backend,
                        id.binding_name(),
                        shape,
                        channel.item_size,
                        channel.dtype,
                    )?))
                })?
            }
            Association::Lut => return self.ensure_lut(binding, data, report),
        };

        if slot.is_created() {
            report.allocated.push(id);
        }
        Ok(Some(slot.key()))
    }

    /// LUT textures follow the width of the uploaded data
    ///
    /// Without data a one-texel placeholder is allocated so drawables always
    /// have a complete set of bindings.
    fn ensure_lut(
        &mut self,
        binding: &ChannelBinding,
        data: Option<&FieldData>,
        report: &mut ReconcileReport,
    ) -> Result<Option<ResourceKey>, RenderError> {
        let channel = binding.channel;
        let id = binding.resource_id();

        let width = match data {
            Some(data) if data.is_empty() => {
                log::warn!("Empty lookup table for channel {}, skipping.", channel.name);
                report.skipped.push((channel.name.to_string(), SkipReason::EmptyData));
                return Ok(None);
            }
            Some(data) => {
                let item_size = channel.item_size.max(1);
                if data.len() % item_size != 0 {
                    log::warn!(
                        "Lookup table {} has {} values, not a multiple of item size {}",
                        channel.name, data.len(), item_size
                    );
                }
                data.len().div_ceil(item_size) as u32
            }
            None => 1,
        };
        let shape = TextureShape::row(width);

        let backend = &mut *self.backend;
        let allocate = |backend: &mut B| -> Result<Resource<B>, RenderError> {
            Ok(Resource::Texture(TextureResource::allocate(
                backend,
                id.binding_name(),
                shape,
                channel.item_size,
                channel.dtype,
            )?))
        };

        match self.registry.key(channel.name, Association::Lut) {
            None => {
                log::debug!("Allocating lut texture for {} with width {}", channel.name, width);
                let slot = self.registry.get_or_create(id.clone(), || allocate(backend))?;
                report.allocated.push(id);
                Ok(Some(slot.key()))
            }
            Some(key) => {
                let current = self
                    .registry
                    .get(key)
                    .and_then(Resource::as_texture)
                    .map(|tex| tex.shape);
                if data.is_some() && current != Some(shape) {
                    log::debug!(
                        "Reallocating lut texture for {}: {:?} -> width {}",
                        channel.name, current.map(|s| s.width), width
                    );
                    let resource = allocate(backend)?;
                    self.registry.replace(key, resource);
                    report.allocated.push(id);
                }
                Ok(Some(key))
            }
        }
    }
}

/// Errors that abort a pass instead of skipping a channel
fn is_fatal(err: &RenderError, mode: ReconcileMode) -> bool {
    match err {
        RenderError::UnsupportedItemSize(_) => true,
        _ => mode.allocate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::DEFAULT_CHANNELS;
    use crate::encoding::EncodingEntry;
    use crate::host::HostBackend;
    use crate::texture_shape::plan;

    fn extents() -> Extents {
        Extents { cells: plan(4).unwrap(), vertices: plan(6).unwrap() }
    }

    fn default_bindings() -> Vec<ChannelBinding> {
        resolve_bindings(&Encoding::identity(&DEFAULT_CHANNELS), &DEFAULT_CHANNELS).0
    }

    #[test]
    fn test_resolve_default_bindings() {
        let (bindings, skipped) = resolve_bindings(&Encoding::identity(&DEFAULT_CHANNELS), &DEFAULT_CHANNELS);
        assert_eq!(bindings.len(), 6);
        assert!(skipped.is_empty());
        assert_eq!(bindings[0].channel.name, "cells");
        assert_eq!(bindings[0].association, Association::Cell);
    }

    #[test]
    fn test_resolve_skips_missing_and_unknown() {
        let mut encoding = Encoding::identity(&DEFAULT_CHANNELS);
        encoding.remove("emission");
        encoding.insert(
            "density",
            EncodingEntry { field: "density".into(), association: Some("voxel".into()) },
        );
        encoding.insert("velocity", EncodingEntry::new("velocity"));

        let (bindings, skipped) = resolve_bindings(&encoding, &DEFAULT_CHANNELS);
        assert_eq!(bindings.len(), 4);
        assert!(skipped.contains(&("emission".to_string(), SkipReason::MissingEncoding)));
        assert!(skipped.contains(&("density".to_string(), SkipReason::UnknownAssociation("voxel".into()))));
        assert!(skipped.contains(&("velocity".to_string(), SkipReason::UnknownChannel)));
    }

    #[test]
    fn test_allocate_pass_creates_everything() {
        let mut backend = HostBackend::new();
        let mut registry = ResourceRegistry::new();
        let report = Allocator::new(&mut backend, &mut registry, extents())
            .reconcile(&default_bindings(), None, ReconcileMode::ALLOCATE)
            .unwrap();

        assert_eq!(report.allocated.len(), 6);
        assert!(report.updated.is_empty());
        assert_eq!(registry.texture("cells").unwrap().shape, plan(4).unwrap());
        assert_eq!(registry.texture("density").unwrap().shape, plan(6).unwrap());
        assert_eq!(registry.texture("emission_lut").unwrap().shape, TextureShape::row(1));
    }

    #[test]
    fn test_allocate_twice_is_idempotent() {
        let mut backend = HostBackend::new();
        let mut registry = ResourceRegistry::new();
        let bindings = default_bindings();
        Allocator::new(&mut backend, &mut registry, extents())
            .reconcile(&bindings, None, ReconcileMode::ALLOCATE)
            .unwrap();
        let report = Allocator::new(&mut backend, &mut registry, extents())
            .reconcile(&bindings, None, ReconcileMode::ALLOCATE)
            .unwrap();
        assert!(report.allocated.is_empty());
        assert_eq!(backend.textures_created(), 6);
    }

    #[test]
    fn test_uniform_override() {
        let encoding = Encoding::identity(&DEFAULT_CHANNELS).with(
            "emission",
            EncodingEntry::new("glow").with_association(Association::Uniform),
        );
        let (bindings, _) = resolve_bindings(&encoding, &DEFAULT_CHANNELS);
        let mut backend = HostBackend::new();
        let mut registry = ResourceRegistry::new();

        Allocator::new(&mut backend, &mut registry, extents())
            .reconcile(&bindings, None, ReconcileMode::ALLOCATE)
            .unwrap();
        assert_eq!(registry.uniform("emission"), Some(&UniformValue::Scalar(0.0)));

        let data = Dataset::new().with_field("glow", vec![2.5f32]);
        let report = Allocator::new(&mut backend, &mut registry, extents())
            .reconcile(&bindings, Some(&data), ReconcileMode::update(true))
            .unwrap();
        assert!(report.was_updated("emission"));
        assert_eq!(registry.uniform("emission"), Some(&UniformValue::Scalar(2.5)));
        assert_eq!(registry.range("emission").unwrap().to_array(), [2.5, 2.5, 0.0, 1.0]);
    }

    #[test]
    fn test_lut_reallocates_on_width_change() {
        let mut backend = HostBackend::new();
        let mut registry = ResourceRegistry::new();
        let bindings = default_bindings();

        let first = Dataset::new().with_field("density_lut", vec![0.0f32; 16]);
        Allocator::new(&mut backend, &mut registry, extents())
            .reconcile(&bindings, Some(&first), ReconcileMode::update(true))
            .unwrap();
        let key = registry.key("density_lut", Association::Lut).unwrap();
        assert_eq!(registry.texture("density_lut").unwrap().shape.width, 16);

        let second = Dataset::new().with_field("density_lut", vec![1.0f32; 32]);
        Allocator::new(&mut backend, &mut registry, extents())
            .reconcile(&bindings, Some(&second), ReconcileMode::update(true))
            .unwrap();
        let tex = registry.texture("density_lut").unwrap();
        assert_eq!(tex.shape.width, 32);
        assert_eq!(tex.texels(), &[1.0; 32]);
        assert_eq!(registry.key("density_lut", Association::Lut), Some(key));
    }

    #[test]
    fn test_rgb_lut_width() {
        let mut backend = HostBackend::new();
        let mut registry = ResourceRegistry::new();
        let data = Dataset::new().with_field("emission_lut", vec![0.5f32; 3 * 10]);
        Allocator::new(&mut backend, &mut registry, extents())
            .reconcile(&default_bindings(), Some(&data), ReconcileMode::update(true))
            .unwrap();
        let tex = registry.texture("emission_lut").unwrap();
        assert_eq!(tex.shape, TextureShape::row(10));
        assert_eq!(tex.components, 3);
    }

    #[test]
    fn test_update_without_allocation_skips() {
        let mut backend = HostBackend::new();
        let mut registry = ResourceRegistry::new();
        let data = Dataset::new().with_field("density", vec![1.0f32; 6]);
        let report = Allocator::new(&mut backend, &mut registry, extents())
            .reconcile(&default_bindings(), Some(&data), ReconcileMode::update(false))
            .unwrap();
        assert!(report.skipped.contains(&("density".to_string(), SkipReason::NotAllocated)));
        assert!(registry.is_empty());
        assert_eq!(registry.range("density"), Some(DataRange::UNIT));
    }

    #[test]
    fn test_oversized_data_is_skipped() {
        let mut backend = HostBackend::new();
        let mut registry = ResourceRegistry::new();
        let bindings = default_bindings();
        Allocator::new(&mut backend, &mut registry, extents())
            .reconcile(&bindings, None, ReconcileMode::ALLOCATE)
            .unwrap();

        let data = Dataset::new()
            .with_field("density", vec![1.0f32; 1000])
            .with_field("emission", vec![3.0f32; 6]);
        let report = Allocator::new(&mut backend, &mut registry, extents())
            .reconcile(&bindings, Some(&data), ReconcileMode::update(true))
            .unwrap();
        assert!(report.was_skipped("density"));
        assert!(report.was_updated("emission"));
        assert_eq!(registry.range("density"), Some(DataRange::UNIT));
    }

    #[test]
    fn test_backend_limit_fatal_on_allocate() {
        let mut backend = HostBackend::new().with_max_texture_dimension(2);
        let mut registry = ResourceRegistry::new();
        let result = Allocator::new(&mut backend, &mut registry, extents())
            .reconcile(&default_bindings(), None, ReconcileMode::ALLOCATE);
        assert!(matches!(result, Err(RenderError::Backend(_))));
    }

    #[test]
    fn test_backend_limit_skipped_on_update() {
        let mut backend = HostBackend::new().with_max_texture_dimension(8);
        let mut registry = ResourceRegistry::new();
        let data = Dataset::new()
            .with_field("density_lut", vec![0.0f32; 64])
            .with_field("emission_lut", vec![0.0f32; 6]);
        let report = Allocator::new(&mut backend, &mut registry, extents())
            .reconcile(&default_bindings(), Some(&data), ReconcileMode::update(true))
            .unwrap();
        assert!(report.was_skipped("density_lut"));
        assert!(report.was_updated("emission_lut"));
    }
}
