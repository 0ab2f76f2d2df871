//! [`GraphicsBackend`] implementation on top of wgpu
//!
//! Data textures are float textures read with `textureLoad`; writes go
//! through the queue and land at the next submission.

use std::borrow::Cow;

use tetvol_core::{
    BackendError, BufferDescriptor, DefineFlags, GeometryDescriptor, GraphicsBackend,
    ProgramDescriptor, TextureDescriptor, TextureShape,
};
use wgpu::util::DeviceExt;

use crate::context::RenderContext;
use crate::pipeline::{create_mesh_pipeline, texture_format, MeshLayout, MeshPipelineDescriptor, MeshUniforms};

/// A packed data texture on the GPU
pub struct GpuTexture {
    pub label: String,
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub shape: TextureShape,
    /// Components of the channel data
    pub components: u32,
    /// `f32` values per texel in the texture format
    pub texel_len: u32,
}

/// A per-instance vertex buffer
pub struct GpuBuffer {
    pub label: String,
    pub buffer: wgpu::Buffer,
    pub len: usize,
}

/// Pipeline of one method plus its uniform buffer
pub struct GpuProgram {
    pub pipeline: wgpu::RenderPipeline,
    pub uniform_buffer: wgpu::Buffer,
    pub defines: DefineFlags,
}

/// Shared per-vertex buffers of the instanced tetrahedron
pub struct GpuGeometry {
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
    pub local_vertex_buffer: wgpu::Buffer,
    pub vertex_id_buffer: wgpu::Buffer,
    pub instance_count: u32,
}

/// wgpu implementation of the renderer backend
pub struct WgpuBackend {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    target_format: wgpu::TextureFormat,
    layout: MeshLayout,
    /// Bound in place of textures a drawable does not have
    placeholder: wgpu::TextureView,
}

impl WgpuBackend {
    /// Create a backend rendering into targets of `target_format`
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, target_format: wgpu::TextureFormat) -> Self {
        let layout = MeshLayout::new(&device);
        let placeholder = device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some("Placeholder Data Texture"),
                size: wgpu::Extent3d { width: 1, height: 1, depth_or_array_layers: 1 },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba32Float,
                usage: wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            })
            .create_view(&wgpu::TextureViewDescriptor::default());

        Self { device, queue, target_format, layout, placeholder }
    }

    pub fn from_context(context: RenderContext, target_format: wgpu::TextureFormat) -> Self {
        Self::new(context.device, context.queue, target_format)
    }

    #[inline]
    pub fn target_format(&self) -> wgpu::TextureFormat {
        self.target_format
    }

    #[inline]
    pub fn layout(&self) -> &MeshLayout {
        &self.layout
    }

    #[inline]
    pub fn placeholder(&self) -> &wgpu::TextureView {
        &self.placeholder
    }

    fn max_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    fn check_dimension(&self, what: &str, requested: u32) -> Result<(), BackendError> {
        let limit = self.max_dimension();
        if requested > limit {
            return Err(BackendError::LimitExceeded { what: what.to_string(), requested, limit });
        }
        Ok(())
    }
}

/// Spread `data` of `components` values per element over texels of `texel_len`
fn pad_texels(data: &[f32], components: u32, texel_len: u32) -> Cow<'_, [f32]> {
    if components == texel_len {
        return Cow::Borrowed(data);
    }
    let mut padded = vec![0.0; data.len() / components as usize * texel_len as usize];
    for (dst, src) in padded
        .chunks_exact_mut(texel_len as usize)
        .zip(data.chunks_exact(components as usize))
    {
        dst[..src.len()].copy_from_slice(src);
    }
    Cow::Owned(padded)
}

impl GraphicsBackend for WgpuBackend {
    type Texture = GpuTexture;
    type Buffer = GpuBuffer;
    type Program = GpuProgram;
    type Geometry = GpuGeometry;

    fn create_texture(&mut self, desc: &TextureDescriptor<'_>) -> Result<GpuTexture, BackendError> {
        self.check_dimension("texture width", desc.shape.width)?;
        self.check_dimension("texture height", desc.shape.height)?;
        let (format, texel_len) = texture_format(desc.components)
            .ok_or_else(|| BackendError::Other(format!("no texture format for {} components", desc.components)))?;

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(desc.label),
            size: wgpu::Extent3d {
                width: desc.shape.width,
                height: desc.shape.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Ok(GpuTexture { label: desc.label.to_string(), texture, view, shape: desc.shape, components: desc.components, texel_len })
    }

    fn write_texture(&mut self, texture: &mut GpuTexture, texels: &[f32]) -> Result<(), BackendError> {
        let expected = texture.shape.texel_count() * texture.components as usize;
        if texels.len() != expected {
            return Err(BackendError::SizeMismatch {
                label: texture.label.clone(),
                expected,
                actual: texels.len(),
            });
        }

        let data = pad_texels(texels, texture.components, texture.texel_len);
        let bytes_per_texel = texture.texel_len * std::mem::size_of::<f32>() as u32;
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(&data),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(texture.shape.width * bytes_per_texel),
                rows_per_image: Some(texture.shape.height),
            },
            wgpu::Extent3d {
                width: texture.shape.width,
                height: texture.shape.height,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }

    fn create_buffer(&mut self, desc: &BufferDescriptor<'_>, contents: &[f32]) -> Result<GpuBuffer, BackendError> {
        if contents.is_empty() {
            return Err(BackendError::Other(format!("buffer '{}' would be empty", desc.label)));
        }
        let mut usage = wgpu::BufferUsages::VERTEX;
        if desc.dynamic {
            usage |= wgpu::BufferUsages::COPY_DST;
        }
        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(desc.label),
            contents: bytemuck::cast_slice(contents),
            usage,
        });
        Ok(GpuBuffer { label: desc.label.to_string(), buffer, len: contents.len() })
    }

    fn write_buffer(&mut self, buffer: &mut GpuBuffer, contents: &[f32]) -> Result<(), BackendError> {
        if contents.len() != buffer.len {
            return Err(BackendError::SizeMismatch {
                label: buffer.label.clone(),
                expected: buffer.len,
                actual: contents.len(),
            });
        }
        if !buffer.buffer.usage().contains(wgpu::BufferUsages::COPY_DST) {
            return Err(BackendError::Other(format!("buffer '{}' was created static", buffer.label)));
        }
        self.queue.write_buffer(&buffer.buffer, 0, bytemuck::cast_slice(contents));
        Ok(())
    }

    fn create_program(&mut self, desc: &ProgramDescriptor<'_>) -> Result<GpuProgram, BackendError> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = create_mesh_pipeline(
            &self.device,
            &self.layout,
            &MeshPipelineDescriptor {
                label: desc.label,
                shaders: desc.shaders,
                defines: desc.defines,
                transparent: desc.transparent,
                blend: desc.blend,
                side: desc.side,
                depth_test: desc.depth_test,
                depth_write: desc.depth_write,
                target_format: self.target_format,
            },
        );
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(BackendError::Program(err.to_string()));
        }

        let uniform_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(desc.label),
            contents: bytemuck::bytes_of(&MeshUniforms::default()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        log::debug!(
            "Created pipeline '{}' with defines [{}]",
            desc.label,
            desc.defines.define_names().collect::<Vec<_>>().join(", ")
        );
        Ok(GpuProgram { pipeline, uniform_buffer, defines: desc.defines })
    }

    fn create_geometry(&mut self, desc: &GeometryDescriptor<'_>) -> Result<GpuGeometry, BackendError> {
        // Index buffers must be a multiple of four bytes
        let mut indices = desc.strip_indices.to_vec();
        if indices.len() % 2 == 1 {
            indices.push(0);
        }
        let index_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(desc.label),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let local_vertex_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(desc.label),
            contents: bytemuck::cast_slice(desc.local_vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let vertex_id_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(desc.label),
            contents: bytemuck::cast_slice(desc.vertex_ids),
            usage: wgpu::BufferUsages::VERTEX,
        });

        Ok(GpuGeometry {
            index_buffer,
            index_count: desc.strip_indices.len() as u32,
            local_vertex_buffer,
            vertex_id_buffer,
            instance_count: desc.instance_count,
        })
    }
}
