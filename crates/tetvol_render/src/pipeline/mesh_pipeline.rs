//! Render pipelines for instanced tetrahedra
//!
//! One pipeline per configured method. All of them share a bind group layout
//! (uniform block + six data textures) and the same three vertex buffers:
//! local vertex rotations and local ids per vertex, cell ordering per instance.

use std::collections::HashMap;

use tetvol_core::{BlendConfig, BlendEquation, BlendFactor, DefineFlags, ShaderSources, Side};

/// Texture bindings in binding order, starting at binding 1
pub const TEXTURE_SLOTS: [&str; 6] = [
    "t_cells",
    "t_coordinates",
    "t_density",
    "t_emission",
    "t_density_lut",
    "t_emission_lut",
];

/// Texture format and `f32` values per texel for a component count
///
/// There is no three-channel float format, so RGB data is padded to RGBA.
pub fn texture_format(components: u32) -> Option<(wgpu::TextureFormat, u32)> {
    match components {
        1 => Some((wgpu::TextureFormat::R32Float, 1)),
        2 => Some((wgpu::TextureFormat::Rg32Float, 2)),
        3 | 4 => Some((wgpu::TextureFormat::Rgba32Float, 4)),
        _ => None,
    }
}

/// Cull mode drawing the faces `side` asks for
pub fn cull_mode(side: Side) -> Option<wgpu::Face> {
    match side {
        Side::Front => Some(wgpu::Face::Back),
        Side::Back => Some(wgpu::Face::Front),
        Side::Double => None,
    }
}

fn blend_factor(factor: BlendFactor) -> wgpu::BlendFactor {
    match factor {
        BlendFactor::Zero => wgpu::BlendFactor::Zero,
        BlendFactor::One => wgpu::BlendFactor::One,
        BlendFactor::SrcAlpha => wgpu::BlendFactor::SrcAlpha,
        BlendFactor::OneMinusSrcAlpha => wgpu::BlendFactor::OneMinusSrcAlpha,
        BlendFactor::DstAlpha => wgpu::BlendFactor::DstAlpha,
        BlendFactor::OneMinusDstAlpha => wgpu::BlendFactor::OneMinusDstAlpha,
    }
}

fn blend_operation(equation: BlendEquation) -> wgpu::BlendOperation {
    match equation {
        BlendEquation::Add => wgpu::BlendOperation::Add,
        BlendEquation::Subtract => wgpu::BlendOperation::Subtract,
        BlendEquation::ReverseSubtract => wgpu::BlendOperation::ReverseSubtract,
        BlendEquation::Min => wgpu::BlendOperation::Min,
        BlendEquation::Max => wgpu::BlendOperation::Max,
    }
}

/// Blend state for a method
///
/// Opaque methods replace the target; transparent ones without a custom
/// configuration use regular alpha blending.
pub fn blend_state(transparent: bool, blend: Option<BlendConfig>) -> wgpu::BlendState {
    match (transparent, blend) {
        (_, Some(config)) => {
            let component = wgpu::BlendComponent {
                src_factor: blend_factor(config.src),
                dst_factor: blend_factor(config.dst),
                operation: blend_operation(config.equation),
            };
            wgpu::BlendState { color: component, alpha: component }
        }
        (true, None) => wgpu::BlendState::ALPHA_BLENDING,
        (false, None) => wgpu::BlendState::REPLACE,
    }
}

/// Pipeline-overridable constants for a define set
///
/// Every known define is passed, absent ones as `0.0`.
pub fn override_constants(defines: DefineFlags) -> HashMap<String, f64> {
    DefineFlags::NAMES
        .iter()
        .map(|(name, flag)| (name.to_string(), if defines.contains(*flag) { 1.0 } else { 0.0 }))
        .collect()
}

/// Bind group and pipeline layouts shared by all methods
pub struct MeshLayout {
    pub bind_group_layout: wgpu::BindGroupLayout,
    pub pipeline_layout: wgpu::PipelineLayout,
}

impl MeshLayout {
    pub fn new(device: &wgpu::Device) -> Self {
        let mut entries = vec![
            // Uniforms
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ];
        // Data textures, read with textureLoad only
        entries.extend((0..TEXTURE_SLOTS.len() as u32).map(|i| wgpu::BindGroupLayoutEntry {
            binding: i + 1,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: false },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        }));

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Tetra Mesh Bind Group Layout"),
            entries: &entries,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Tetra Mesh Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        Self { bind_group_layout, pipeline_layout }
    }
}

/// Vertex buffer layouts: local vertex rotations, local vertex id, ordering
pub fn vertex_buffer_layouts() -> [wgpu::VertexBufferLayout<'static>; 3] {
    [
        // a_local_vertices: vec4<f32>
        wgpu::VertexBufferLayout {
            array_stride: 4 * std::mem::size_of::<f32>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x4,
                offset: 0,
                shader_location: 0,
            }],
        },
        // a_vertex_id: f32
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<f32>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32,
                offset: 0,
                shader_location: 1,
            }],
        },
        // c_ordering: f32 per instance
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<f32>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32,
                offset: 0,
                shader_location: 2,
            }],
        },
    ]
}

/// Everything a method pipeline is built from
pub struct MeshPipelineDescriptor<'a> {
    pub label: &'a str,
    pub shaders: &'a ShaderSources,
    pub defines: DefineFlags,
    pub transparent: bool,
    pub blend: Option<BlendConfig>,
    pub side: Side,
    pub depth_test: bool,
    pub depth_write: bool,
    pub target_format: wgpu::TextureFormat,
}

/// Create the render pipeline of one method
///
/// Both shader sources go into a single module; the vertex source carries the
/// shared declarations.
pub fn create_mesh_pipeline(
    device: &wgpu::Device,
    layout: &MeshLayout,
    desc: &MeshPipelineDescriptor<'_>,
) -> wgpu::RenderPipeline {
    let source = format!("{}\n{}", desc.shaders.vertex, desc.shaders.fragment);
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(desc.label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });

    let constants = override_constants(desc.defines);
    let buffers = vertex_buffer_layouts();

    let depth_stencil = desc.depth_test.then(|| wgpu::DepthStencilState {
        format: wgpu::TextureFormat::Depth32Float,
        depth_write_enabled: desc.depth_write,
        depth_compare: wgpu::CompareFunction::Less,
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(desc.label),
        layout: Some(&layout.pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &buffers,
            compilation_options: wgpu::PipelineCompilationOptions {
                constants: &constants,
                zero_initialize_workgroup_memory: true,
            },
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: desc.target_format,
                blend: Some(blend_state(desc.transparent, desc.blend)),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions {
                constants: &constants,
                zero_initialize_workgroup_memory: true,
            },
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleStrip,
            strip_index_format: Some(wgpu::IndexFormat::Uint16),
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: cull_mode(desc.side),
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil,
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tetvol_core::Method;

    #[test]
    fn test_texture_formats() {
        assert_eq!(texture_format(1), Some((wgpu::TextureFormat::R32Float, 1)));
        assert_eq!(texture_format(3), Some((wgpu::TextureFormat::Rgba32Float, 4)));
        assert_eq!(texture_format(5), None);
    }

    #[test]
    fn test_cull_modes() {
        assert_eq!(cull_mode(Side::Double), None);
        assert_eq!(cull_mode(Side::Back), Some(wgpu::Face::Front));
    }

    #[test]
    fn test_mip_blend_state() {
        let props = Method::Mip.properties();
        let state = blend_state(props.transparent, props.blend);
        assert_eq!(state.color.operation, wgpu::BlendOperation::Max);
        assert_eq!(state.color.src_factor, wgpu::BlendFactor::One);
        assert_eq!(state.color.dst_factor, wgpu::BlendFactor::One);
    }

    #[test]
    fn test_surface_blend_replaces() {
        let props = Method::Surface.properties();
        assert_eq!(blend_state(props.transparent, props.blend), wgpu::BlendState::REPLACE);
    }

    #[test]
    fn test_override_constants() {
        let constants = override_constants(Method::Xray.properties().effective_defines());
        assert_eq!(constants.len(), 4);
        assert_eq!(constants["ENABLE_CELL_ORDERING"], 1.0);
        assert_eq!(constants["ENABLE_DENSITY"], 1.0);
        assert_eq!(constants["ENABLE_EMISSION"], 0.0);
    }

    #[test]
    fn test_vertex_layouts() {
        let layouts = vertex_buffer_layouts();
        assert_eq!(layouts[0].array_stride, 16);
        assert_eq!(layouts[2].step_mode, wgpu::VertexStepMode::Instance);
    }
}
