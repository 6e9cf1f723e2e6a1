use std::num::NonZeroU64;

use crate::{
    data_structures::{
        gbuffer::GBufferChannel,
        model::{ModelVertex, Vertex},
        texture::Texture,
    },
    pipelines::{mk_render_pipeline, shader::Shader},
    resources::texture::material_layout,
};

/// Matrices of one geometry-pass draw, bound with a dynamic offset.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawUniform {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
}

impl DrawUniform {
    pub const SIZE: u64 = std::mem::size_of::<DrawUniform>() as u64;
}

pub fn draw_uniform_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: true,
                min_binding_size: NonZeroU64::new(DrawUniform::SIZE),
            },
            count: None,
        }],
        label: Some("draw_uniform_bind_group_layout"),
    })
}

/// Pipeline writing all five G-buffer targets with depth testing and no blending.
#[derive(Debug)]
pub struct GeometryPipeline {
    pub pipeline: wgpu::RenderPipeline,
    pub material_layout: wgpu::BindGroupLayout,
    pub uniform_layout: wgpu::BindGroupLayout,
}

impl GeometryPipeline {
    pub fn new(device: &wgpu::Device, shader: &Shader) -> Self {
        let material_layout = material_layout(device);
        let uniform_layout = draw_uniform_layout(device);
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Geometry Pipeline Layout"),
            bind_group_layouts: &[&material_layout, &uniform_layout],
            ..Default::default()
        });
        let targets = GBufferChannel::ALL.map(|_| {
            Some(wgpu::ColorTargetState {
                format: Texture::GBUFFER_FORMAT,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })
        });
        let pipeline = mk_render_pipeline(
            device,
            "Geometry Pipeline",
            &layout,
            &targets,
            Some(Texture::DEPTH_FORMAT),
            Some(wgpu::Face::Back),
            &[ModelVertex::desc()],
            shader,
        );
        Self {
            pipeline,
            material_layout,
            uniform_layout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draw_uniform_is_four_matrices_and_a_vector() {
        assert_eq!(DrawUniform::SIZE, 4 * 64 + 16);
    }
}
