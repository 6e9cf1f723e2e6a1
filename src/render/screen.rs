//! Screen pass: samples the G-buffer onto the window with a full-screen quad.

use wgpu::util::DeviceExt;

use crate::{
    data_structures::gbuffer::{GBuffer, GBufferChannel},
    error::RenderError,
    pipelines::{
        screen::{QUAD_INDICES, ScreenPipeline, ScreenUniform},
        shader::Shader,
    },
};

#[derive(Debug)]
pub struct ScreenPass {
    pipeline: ScreenPipeline,
    sampler: wgpu::Sampler,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    /// G-buffer bind group and the position target it was built for.
    gbuffer_bind_group: Option<(wgpu::Texture, wgpu::BindGroup)>,
    pub clear_color: wgpu::Color,
}

impl ScreenPass {
    pub fn new(
        device: &wgpu::Device,
        shader: &Shader,
        surface_format: wgpu::TextureFormat,
        clear_color: wgpu::Color,
    ) -> Self {
        let pipeline = ScreenPipeline::new(device, shader, surface_format);
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("G-buffer sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Screen Uniform Buffer"),
            contents: bytemuck::cast_slice(&[ScreenUniform::new(
                [0.0; 3],
                [0.0; 3],
                Default::default(),
            )]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &pipeline.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
            label: Some("screen_uniform_bind_group"),
        });
        Self {
            pipeline,
            sampler,
            uniform_buffer,
            uniform_bind_group,
            gbuffer_bind_group: None,
            clear_color,
        }
    }

    /// Rebuild the G-buffer bind group if the attachments changed since the last frame.
    fn refresh_bind_group(
        &mut self,
        device: &wgpu::Device,
        gbuffer: &GBuffer,
    ) -> Result<(), RenderError> {
        let position = gbuffer
            .attachment(GBufferChannel::Position)
            .ok_or(RenderError::Destroyed)?;
        if matches!(&self.gbuffer_bind_group, Some((cached, _)) if *cached == position.texture) {
            return Ok(());
        }
        let views = gbuffer.views().ok_or(RenderError::Destroyed)?;
        let mut entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Sampler(&self.sampler),
        }];
        entries.extend(views.iter().enumerate().map(|(slot, view)| wgpu::BindGroupEntry {
            binding: slot as u32 + 1,
            resource: wgpu::BindingResource::TextureView(view),
        }));
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.pipeline.gbuffer_layout,
            entries: &entries,
            label: Some("gbuffer_bind_group"),
        });
        log::debug!(
            "G-buffer bind group rebuilt for generation {}",
            gbuffer.generation()
        );
        self.gbuffer_bind_group = Some((position.texture.clone(), bind_group));
        Ok(())
    }

    /// Draw the quad into `target`, which is `target_size` pixels large.
    /// Must run after the geometry pass has ended.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        target_size: [u32; 2],
        gbuffer: &GBuffer,
        uniform: ScreenUniform,
    ) -> Result<(), RenderError> {
        if gbuffer.is_destroyed() {
            self.gbuffer_bind_group = None;
            return Err(RenderError::Destroyed);
        }
        self.refresh_bind_group(device, gbuffer)?;
        let Some((_, gbuffer_bind_group)) = &self.gbuffer_bind_group else {
            return Err(RenderError::Destroyed);
        };
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniform]));

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Screen Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.clear_color),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        let [width, height] = target_size;
        render_pass.set_viewport(0.0, 0.0, width.max(1) as f32, height.max(1) as f32, 0.0, 1.0);
        render_pass.set_pipeline(&self.pipeline.pipeline);
        render_pass.set_bind_group(0, gbuffer_bind_group, &[]);
        render_pass.set_bind_group(1, &self.uniform_bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.pipeline.vertex_buffer.slice(..));
        render_pass.set_index_buffer(
            self.pipeline.index_buffer.slice(..),
            wgpu::IndexFormat::Uint16,
        );
        render_pass.draw_indexed(0..QUAD_INDICES.len() as u32, 0, 0..1);
        Ok(())
    }
}
