//! Frame composition: geometry pass into the G-buffer, then the screen pass.
//!
//! [`DeferredRenderer`] owns the G-buffer and everything both passes need.
//! A frame never fails because of a single entity: entities that cannot be
//! drawn are logged and counted in the [`FrameReport`].

pub mod geometry;
pub mod screen;

use crate::{
    config::{Config, to_color},
    context::Context,
    data_structures::gbuffer::GBuffer,
    error::RenderError,
    flow::World,
    pipelines::{geometry::GeometryPipeline, screen::ScreenUniform, shader::Shader},
    render::{geometry::GeometryRenderer, screen::ScreenPass},
};

/// What happened during one frame.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Entities drawn into the G-buffer.
    pub drawn: usize,
    /// Renderable entities that were skipped because of an error.
    pub skipped: usize,
    /// A pass could not run at all.
    pub pass_failed: bool,
}

#[derive(Debug)]
pub struct DeferredRenderer {
    gbuffer: GBuffer,
    geometry_pipeline: GeometryPipeline,
    geometry: GeometryRenderer,
    screen: ScreenPass,
}

impl DeferredRenderer {
    /// Create the G-buffer and both passes. Fails if the G-buffer is incomplete.
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        config: &Config,
    ) -> Result<Self, RenderError> {
        let gbuffer = GBuffer::new(device, config.gbuffer.size())?;
        let geometry_pipeline = GeometryPipeline::new(device, &Shader::geometry(device));
        let geometry = GeometryRenderer::new(
            device,
            &geometry_pipeline,
            to_color(config.gbuffer.clear_color),
        );
        let screen = ScreenPass::new(
            device,
            &Shader::screen(device),
            surface_format,
            to_color(config.screen.clear_color),
        );
        Ok(Self {
            gbuffer,
            geometry_pipeline,
            geometry,
            screen,
        })
    }

    pub fn gbuffer(&self) -> &GBuffer {
        &self.gbuffer
    }

    pub fn gbuffer_mut(&mut self) -> &mut GBuffer {
        &mut self.gbuffer
    }

    pub fn geometry_pipeline(&self) -> &GeometryPipeline {
        &self.geometry_pipeline
    }

    /// Render `world` into the next surface texture and present it.
    pub fn render_frame(
        &mut self,
        ctx: &Context,
        world: &World,
    ) -> Result<FrameReport, wgpu::SurfaceError> {
        let output = ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let size = [output.texture.width(), output.texture.height()];
        let report = self.render_to_view(&ctx.device, &ctx.queue, &view, size, world);
        output.present();
        Ok(report)
    }

    /// Run both passes with `target` as the screen pass output and submit them.
    pub fn render_to_view(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        target: &wgpu::TextureView,
        target_size: [u32; 2],
        world: &World,
    ) -> FrameReport {
        let mut report = FrameReport::default();
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Frame Encoder"),
        });

        match self
            .geometry
            .setup(device, &mut encoder, &self.gbuffer, world.scene.len())
        {
            Ok(mut pass) => {
                for (id, entity, parent_world) in world.scene.iter_depth_first() {
                    match pass.render(
                        entity,
                        &world.camera,
                        &self.geometry_pipeline,
                        &world.assets,
                        parent_world,
                    ) {
                        Ok(true) => report.drawn += 1,
                        Ok(false) => (),
                        Err(err) => {
                            log::warn!("Skipping entity {:?} ({}): {}", id, entity.name, err);
                            report.skipped += 1;
                        }
                    }
                }
                pass.cleanup(queue);
            }
            Err(err) => {
                log::error!("Geometry pass failed: {}", err);
                report.pass_failed = true;
            }
        }

        let uniform = ScreenUniform::new(
            world.light_position.into(),
            world.camera.world_position().into(),
            world.channel,
        );
        if let Err(err) = self.screen.render(
            device,
            queue,
            &mut encoder,
            target,
            target_size,
            &self.gbuffer,
            uniform,
        ) {
            log::error!("Screen pass failed: {}", err);
            report.pass_failed = true;
        }

        queue.submit(std::iter::once(encoder.finish()));
        report
    }
}
