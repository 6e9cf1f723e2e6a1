//! Geometry pass: draws every renderable entity into the G-buffer.
//!
//! [`GeometryRenderer::setup`] begins the pass, each [`GeometryPass::draw`]
//! records one indexed draw, and [`GeometryPass::cleanup`] uploads the staged
//! matrices and ends the pass. The encoder is borrowed for the whole pass, so
//! the G-buffer cannot be bound twice.

use std::num::NonZeroU64;

use crate::{
    camera::Camera,
    data_structures::{
        gbuffer::GBuffer,
        model::{Material, Mesh},
        scene_graph::{Entity, Transform},
    },
    error::RenderError,
    math::Matrix,
    pipelines::geometry::{DrawUniform, GeometryPipeline},
    resources::Assets,
};

/// Everything one draw needs. Mesh and material are optional so that a
/// missing one is reported instead of skipped silently.
pub struct RenderParams<'a> {
    pub pipeline: &'a GeometryPipeline,
    pub camera: &'a Camera,
    pub mesh: Option<&'a Mesh>,
    pub material: Option<&'a Material>,
    pub transform: Transform,
    pub parent_world: Matrix,
}

/// Owns the per-draw uniform buffer, which grows on demand.
#[derive(Debug)]
pub struct GeometryRenderer {
    uniform_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    capacity: usize,
    stride: u64,
    pub clear_color: wgpu::Color,
}

impl GeometryRenderer {
    const INITIAL_CAPACITY: usize = 64;

    pub fn new(
        device: &wgpu::Device,
        pipeline: &GeometryPipeline,
        clear_color: wgpu::Color,
    ) -> Self {
        let alignment = device.limits().min_uniform_buffer_offset_alignment as u64;
        let stride = DrawUniform::SIZE.next_multiple_of(alignment);
        let uniform_layout = pipeline.uniform_layout.clone();
        let (uniform_buffer, bind_group) =
            create_uniforms(device, &uniform_layout, Self::INITIAL_CAPACITY, stride);
        Self {
            uniform_layout,
            uniform_buffer,
            bind_group,
            capacity: Self::INITIAL_CAPACITY,
            stride,
            clear_color,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn ensure_capacity(&mut self, device: &wgpu::Device, draw_capacity: usize) {
        if draw_capacity <= self.capacity {
            return;
        }
        let capacity = draw_capacity.next_power_of_two();
        let (uniform_buffer, bind_group) =
            create_uniforms(device, &self.uniform_layout, capacity, self.stride);
        self.uniform_buffer.destroy();
        self.uniform_buffer = uniform_buffer;
        self.bind_group = bind_group;
        self.capacity = capacity;
        log::debug!("Geometry pass uniform buffer grown to {capacity} draws");
    }

    /// Begin the geometry pass on `gbuffer`: all targets cleared, viewport at
    /// the G-buffer resolution, room for `draw_capacity` draws.
    pub fn setup<'a>(
        &'a mut self,
        device: &wgpu::Device,
        encoder: &'a mut wgpu::CommandEncoder,
        gbuffer: &GBuffer,
        draw_capacity: usize,
    ) -> Result<GeometryPass<'a>, RenderError> {
        if !gbuffer.is_complete() {
            return Err(if gbuffer.is_destroyed() {
                RenderError::Destroyed
            } else {
                let reason = "G-buffer failed its completeness check";
                RenderError::IncompleteFramebuffer(reason.to_string())
            });
        }
        self.ensure_capacity(device, draw_capacity);

        let color_attachments = gbuffer.color_attachments(self.clear_color)?;
        let depth_stencil_attachment = gbuffer.depth_stencil_attachment()?;
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Geometry Pass"),
            color_attachments: &color_attachments,
            depth_stencil_attachment: Some(depth_stencil_attachment),
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        let [width, height] = gbuffer.size();
        render_pass.set_viewport(0.0, 0.0, width as f32, height as f32, 0.0, 1.0);

        Ok(GeometryPass {
            render_pass,
            renderer: self,
            staged: Vec::with_capacity(draw_capacity),
            capacity: draw_capacity,
        })
    }
}

fn create_uniforms(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    capacity: usize,
    stride: u64,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Draw Uniform Buffer"),
        size: stride * capacity.max(1) as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: NonZeroU64::new(DrawUniform::SIZE),
            }),
        }],
        label: Some("draw_uniform_bind_group"),
    });
    (buffer, bind_group)
}

/// An open geometry pass. Finish it with [`GeometryPass::cleanup`].
pub struct GeometryPass<'a> {
    render_pass: wgpu::RenderPass<'a>,
    renderer: &'a GeometryRenderer,
    staged: Vec<DrawUniform>,
    capacity: usize,
}

impl GeometryPass<'_> {
    /// Draw `entity` if it has a mesh. Returns whether a draw was recorded.
    pub fn render(
        &mut self,
        entity: &Entity,
        camera: &Camera,
        pipeline: &GeometryPipeline,
        assets: &Assets,
        parent_world: Matrix,
    ) -> Result<bool, RenderError> {
        let Some(mesh) = entity.mesh() else {
            return Ok(false);
        };
        self.draw(RenderParams {
            pipeline,
            camera,
            mesh: assets.mesh(mesh.mesh),
            material: entity.material(),
            transform: entity.transform,
            parent_world,
        })?;
        Ok(true)
    }

    pub fn draw(&mut self, params: RenderParams) -> Result<(), RenderError> {
        let mesh = params.mesh.ok_or(RenderError::MissingParameter("mesh"))?;
        let material = params
            .material
            .ok_or(RenderError::MissingParameter("material"))?;
        if self.staged.len() >= self.capacity {
            return Err(RenderError::DrawCapacityExceeded {
                capacity: self.capacity,
            });
        }

        let model = params.parent_world * params.transform.matrix();
        let camera = params.camera;
        let offset = self.staged.len() as u64 * self.renderer.stride;
        self.staged.push(DrawUniform {
            model: model.into(),
            normal: model.inverse_transpose().into(),
            view: camera.view_matrix().into(),
            projection: camera.wgpu_projection().into(),
            camera_position: camera.world_position().extend(1.0).into(),
        });

        self.render_pass.set_pipeline(&params.pipeline.pipeline);
        self.render_pass.set_bind_group(0, &material.bind_group, &[]);
        self.render_pass
            .set_bind_group(1, &self.renderer.bind_group, &[offset as u32]);
        self.render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.render_pass
            .set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.render_pass.draw_indexed(0..mesh.num_elements, 0, 0..1);
        Ok(())
    }

    /// Number of draws recorded so far.
    pub fn draw_count(&self) -> usize {
        self.staged.len()
    }

    /// Upload the staged uniforms and end the pass. Returns the number of draws.
    pub fn cleanup(self, queue: &wgpu::Queue) -> usize {
        let stride = self.renderer.stride as usize;
        if !self.staged.is_empty() {
            let mut bytes = vec![0u8; self.staged.len() * stride];
            for (chunk, uniform) in bytes.chunks_mut(stride).zip(&self.staged) {
                chunk[..DrawUniform::SIZE as usize].copy_from_slice(bytemuck::bytes_of(uniform));
            }
            queue.write_buffer(&self.renderer.uniform_buffer, 0, &bytes);
        }
        let draws = self.staged.len();
        drop(self.render_pass);
        draws
    }
}
