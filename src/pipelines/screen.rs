use wgpu::util::DeviceExt;

use crate::{
    data_structures::{
        gbuffer::{CHANNEL_COUNT, GBufferChannel},
        model::{ScreenVertex, Vertex},
    },
    pipelines::{mk_render_pipeline, shader::Shader},
};

/// Full-screen quad: four corners, two counter-clockwise triangles.
pub const QUAD_VERTICES: [ScreenVertex; 4] = [
    ScreenVertex { position: [-1.0, -1.0], tex_coords: [0.0, 1.0] },
    ScreenVertex { position: [1.0, -1.0], tex_coords: [1.0, 1.0] },
    ScreenVertex { position: [1.0, 1.0], tex_coords: [1.0, 0.0] },
    ScreenVertex { position: [-1.0, 1.0], tex_coords: [0.0, 0.0] },
];
pub const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ScreenUniform {
    pub light_position: [f32; 4],
    pub view_position: [f32; 4],
    pub channel: u32,
    pub _padding: [u32; 3],
}

impl ScreenUniform {
    pub fn new(light_position: [f32; 3], view_position: [f32; 3], channel: GBufferChannel) -> Self {
        Self {
            light_position: [light_position[0], light_position[1], light_position[2], 1.0],
            view_position: [view_position[0], view_position[1], view_position[2], 1.0],
            channel: channel.select(),
            _padding: [0; 3],
        }
    }
}

/// Sampler at binding 0, the G-buffer textures in slot order at bindings 1 to 5.
pub fn gbuffer_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let mut entries = vec![wgpu::BindGroupLayoutEntry {
        binding: 0,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }];
    entries.extend((0..CHANNEL_COUNT as u32).map(|slot| wgpu::BindGroupLayoutEntry {
        binding: slot + 1,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension: wgpu::TextureViewDimension::D2,
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
        },
        count: None,
    }));
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &entries,
        label: Some("gbuffer_bind_group_layout"),
    })
}

pub fn screen_uniform_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("screen_uniform_bind_group_layout"),
    })
}

#[derive(Debug)]
pub struct ScreenPipeline {
    pub pipeline: wgpu::RenderPipeline,
    pub gbuffer_layout: wgpu::BindGroupLayout,
    pub uniform_layout: wgpu::BindGroupLayout,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
}

impl ScreenPipeline {
    pub fn new(
        device: &wgpu::Device,
        shader: &Shader,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        let gbuffer_layout = gbuffer_layout(device);
        let uniform_layout = screen_uniform_layout(device);
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Screen Pipeline Layout"),
            bind_group_layouts: &[&gbuffer_layout, &uniform_layout],
            ..Default::default()
        });
        let pipeline = mk_render_pipeline(
            device,
            "Screen Pipeline",
            &layout,
            &[Some(wgpu::ColorTargetState {
                format: surface_format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            None,
            None,
            &[ScreenVertex::desc()],
            shader,
        );
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Screen Quad Vertex Buffer"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Screen Quad Index Buffer"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            pipeline,
            gbuffer_layout,
            uniform_layout,
            vertex_buffer,
            index_buffer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screen_uniform_matches_shader_layout() {
        assert_eq!(std::mem::size_of::<ScreenUniform>(), 48);
    }
}
