//! Channel to resource mapping for tetrahedral volume rendering
//!
//! This crate decides how named data channels of a tetrahedral mesh end up
//! in graphics resources, independently of any graphics API:
//!
//! - [`plan`] - Packs N values into a near-square 2D texture extent
//! - [`DataRange`] - Min/max/range/scale tuple consumed by the shaders
//! - [`ChannelSet`] / [`Channel`] - The data a method can consume
//! - [`Method`] - Catalog of rendering methods with defines and blending
//! - [`Encoding`] - Maps channels to dataset fields
//! - [`ResourceRegistry`] - Owner of all uniforms, textures and attributes
//! - [`Allocator`] - Allocates and updates channel resources
//! - [`CellOrdering`] - View-dependent ordering of tetrahedra
//! - [`Drawable`] - Program, geometry and bindings of one method
//! - [`TetrahedralMeshRenderer`] - The public entry point
//!
//! Graphics APIs plug in through [`GraphicsBackend`]. [`HostBackend`] keeps
//! everything in host memory.

mod allocator;
mod backend;
mod channel;
mod config;
mod dataset;
mod drawable;
mod encoding;
mod error;
mod host;
mod method;
mod range;
mod renderer;
mod resources;
mod sort;
mod texture_shape;
mod uniforms;

pub use allocator::{
    resolve_bindings, Allocator, ChannelBinding, Extents, ReconcileMode, ReconcileReport, SkipReason,
};
pub use backend::{
    BackendError, BufferDescriptor, GeometryDescriptor, GraphicsBackend, ProgramDescriptor,
    ShaderSources, TextureDescriptor,
};
pub use channel::{
    Association, Channel, ChannelSet, Dtype, UnknownAssociation, DEFAULT_CHANNELS, RANGE_TRACKED,
};
pub use config::RendererConfig;
pub use dataset::{Dataset, FieldData};
pub use drawable::{
    ordering_id, Binding, Drawable, LOCAL_VERTICES, ORDERING_ATTRIBUTE, STRIP_INDICES, VERTEX_IDS,
};
pub use encoding::{Encoding, EncodingEntry};
pub use error::RenderError;
pub use host::{HostBackend, HostBuffer, HostGeometry, HostProgram, HostTexture};
pub use method::{
    BlendConfig, BlendEquation, BlendFactor, DefineFlags, Method, MethodProperties, Side,
    UnknownMethod,
};
pub use range::DataRange;
pub use renderer::{CameraView, TetrahedralMeshRenderer};
pub use resources::{
    AttributeResource, Resource, ResourceId, ResourceKey, ResourceRegistry, Slot, TextureResource,
};
pub use sort::CellOrdering;
pub use texture_shape::{plan, ShapeError, TextureShape};
pub use uniforms::{SceneUniforms, UniformValue};
