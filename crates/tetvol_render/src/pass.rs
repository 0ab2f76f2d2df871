//! Recording draws of configured drawables
//!
//! Bind groups are rebuilt every frame from the drawable bindings, so
//! reallocated lookup textures are picked up without extra bookkeeping.

use tetvol_core::{Drawable, ResourceRegistry};

use crate::backend::WgpuBackend;
use crate::pipeline::{MeshUniforms, TEXTURE_SLOTS};

/// Uniform block for one drawable
pub fn drawable_uniforms(registry: &ResourceRegistry<WgpuBackend>, drawable: &Drawable<WgpuBackend>) -> MeshUniforms {
    let mut block = MeshUniforms::from_scene(
        &registry.scene,
        registry.range("density").unwrap_or_default(),
        registry.range("emission").unwrap_or_default(),
    );

    let uniform_value = |name: &str| {
        drawable
            .binding(name)
            .and_then(|key| registry.get(key))
            .and_then(|res| res.as_uniform())
            .and_then(|value| value.as_slice().first().copied())
    };
    if let Some(value) = uniform_value("u_density") {
        block = block.with_uniform_density(value);
    }
    if let Some(value) = uniform_value("u_emission") {
        block = block.with_uniform_emission(value);
    }
    block
}

fn bind_group(
    backend: &WgpuBackend,
    registry: &ResourceRegistry<WgpuBackend>,
    drawable: &Drawable<WgpuBackend>,
) -> wgpu::BindGroup {
    let views: Vec<&wgpu::TextureView> = TEXTURE_SLOTS
        .iter()
        .map(|name| {
            drawable
                .binding(name)
                .and_then(|key| registry.get(key))
                .and_then(|res| res.as_texture())
                .map(|tex| &tex.handle().view)
                .unwrap_or_else(|| backend.placeholder())
        })
        .collect();

    let mut entries = vec![wgpu::BindGroupEntry {
        binding: 0,
        resource: drawable.program.uniform_buffer.as_entire_binding(),
    }];
    entries.extend(views.iter().enumerate().map(|(i, view)| wgpu::BindGroupEntry {
        binding: i as u32 + 1,
        resource: wgpu::BindingResource::TextureView(view),
    }));

    backend.device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Tetra Mesh Bind Group"),
        layout: &backend.layout().bind_group_layout,
        entries: &entries,
    })
}

/// Draw `drawables` into `view`, clearing it first
///
/// Drawables whose ordering attribute is missing are skipped.
pub fn render_drawables<'a>(
    backend: &WgpuBackend,
    registry: &ResourceRegistry<WgpuBackend>,
    drawables: impl IntoIterator<Item = &'a Drawable<WgpuBackend>>,
    view: &wgpu::TextureView,
    clear_color: wgpu::Color,
) {
    let mut prepared = Vec::new();
    for drawable in drawables {
        let Some(ordering) = registry.get(drawable.ordering).and_then(|res| res.as_attribute()) else {
            log::warn!("No ordering attribute for {}, skipping draw", drawable.method);
            continue;
        };
        let uniforms = drawable_uniforms(registry, drawable);
        backend
            .queue
            .write_buffer(&drawable.program.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
        prepared.push((drawable, ordering, bind_group(backend, registry, drawable)));
    }

    let mut encoder = backend.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Tetra Mesh Encoder"),
    });

    {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Tetra Mesh Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear_color),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        for (drawable, ordering, bind_group) in &prepared {
            let geometry = &drawable.geometry;
            render_pass.set_pipeline(&drawable.program.pipeline);
            render_pass.set_bind_group(0, bind_group, &[]);
            render_pass.set_vertex_buffer(0, geometry.local_vertex_buffer.slice(..));
            render_pass.set_vertex_buffer(1, geometry.vertex_id_buffer.slice(..));
            render_pass.set_vertex_buffer(2, ordering.handle().buffer.slice(..));
            render_pass.set_index_buffer(geometry.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
            render_pass.draw_indexed(0..geometry.index_count, 0, 0..geometry.instance_count);
        }
    }

    backend.queue.submit(std::iter::once(encoder.finish()));
    log::debug!("Rendered {} drawables", prepared.len());
}
