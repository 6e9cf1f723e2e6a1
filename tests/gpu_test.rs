#[cfg(feature = "integration-tests")]
mod common;

#[cfg(feature = "integration-tests")]
mod gpu {
    use deferred_ngin::{
        camera::Projection,
        config::Config,
        data_structures::{
            component::Component,
            gbuffer::{DEFAULT_GBUFFER_SIZE, GBuffer, GBufferChannel},
            scene_graph::{Entity, Transform},
            texture::{Texture, TextureKind},
        },
        error::RenderError,
        flow::World,
        resources::{
            mesh::load_mesh_obj,
            texture::{load_material, load_texture_or_fallback},
        },
        pipelines::geometry::GeometryPipeline,
        pipelines::shader::Shader,
        render::{
            DeferredRenderer,
            geometry::{GeometryRenderer, RenderParams},
        },
    };

    use crate::common::test_utils::{Gpu, assert_pixel_eq, assert_texel_eq};

    const CENTER: [u32; 2] = [DEFAULT_GBUFFER_SIZE[0] / 2, DEFAULT_GBUFFER_SIZE[1] / 2];

    fn world_with_cube(gpu: &Gpu, config: &Config, with_material: bool) -> World {
        let mut world = World::new(config);
        let cube = world.assets.add_mesh(gpu.cube());
        let mut entity = Entity::new("cube").with_component(Component::mesh(cube));
        if with_material {
            entity.add_component(Component::material(gpu.solid_material([255, 255, 255, 255])));
        }
        world.scene.spawn(entity);
        let [width, height] = DEFAULT_GBUFFER_SIZE;
        world
            .camera
            .update_projection(&Projection::from(&config.camera), width, height);
        world
    }

    #[test]
    fn gbuffer_has_five_half_float_targets_and_depth() {
        let gpu = Gpu::new();
        let mut gbuffer = GBuffer::new(&gpu.device, DEFAULT_GBUFFER_SIZE).unwrap();
        assert!(gbuffer.is_complete());
        for channel in GBufferChannel::ALL {
            let attachment = gbuffer.attachment(channel).unwrap();
            assert_eq!(attachment.format(), Texture::GBUFFER_FORMAT);
            assert_eq!(attachment.size(), [1600, 900]);
        }
        assert_eq!(gbuffer.depth().unwrap().format(), Texture::DEPTH_FORMAT);

        gbuffer.destroy();
        assert!(gbuffer.is_destroyed());
        assert!(!gbuffer.is_complete());
        assert!(gbuffer.views().is_none());
        assert!(matches!(
            gbuffer.color_attachments(wgpu::Color::BLACK),
            Err(RenderError::Destroyed)
        ));
        // Destroying twice is harmless.
        gbuffer.destroy();
        assert_eq!(gpu.errors.count(), 0);
    }

    #[test]
    fn invalid_sizes_are_rejected() {
        let gpu = Gpu::new();
        assert!(matches!(
            GBuffer::new(&gpu.device, [0, 900]),
            Err(RenderError::IncompleteFramebuffer(_))
        ));
        let too_wide = gpu.device.limits().max_texture_dimension_2d + 1;
        assert!(GBuffer::new(&gpu.device, [too_wide, 16]).is_err());
    }

    #[test]
    fn resize_replaces_the_attachments() {
        let gpu = Gpu::new();
        let mut gbuffer = GBuffer::new(&gpu.device, [64, 32]).unwrap();
        let before = gbuffer.generation();
        gbuffer.resize(&gpu.device, [128, 64]).unwrap();
        assert_ne!(gbuffer.generation(), before);
        assert_eq!(gbuffer.size(), [128, 64]);
        assert!(gbuffer.is_complete());
        assert_eq!(gbuffer.attachment(GBufferChannel::Normal).unwrap().size(), [128, 64]);
    }

    #[test]
    fn empty_frame_clears_every_target() {
        let gpu = Gpu::new();
        let config = Config::default();
        let format = wgpu::TextureFormat::Rgba8UnormSrgb;
        let mut renderer = DeferredRenderer::new(&gpu.device, format, &config).unwrap();
        let world = World::new(&config);
        let (_target, view) = gpu.target([320, 180]);

        let report = renderer.render_to_view(&gpu.device, &gpu.queue, &view, [320, 180], &world);
        assert_eq!(report.drawn, 0);
        assert!(!report.pass_failed);

        let clear = config.gbuffer.clear_color.map(|c| c as f32);
        for channel in GBufferChannel::ALL {
            let texel = gpu
                .block_on(renderer.gbuffer().read_texel(&gpu.device, &gpu.queue, channel, 10, 10))
                .unwrap();
            assert_texel_eq(texel, clear, 1e-3);
        }
        assert_eq!(gpu.errors.count(), 0);
    }

    #[test]
    fn cube_writes_its_surface_into_the_gbuffer() {
        let gpu = Gpu::new();
        let config = Config::default();
        let format = wgpu::TextureFormat::Rgba8UnormSrgb;
        let mut renderer = DeferredRenderer::new(&gpu.device, format, &config).unwrap();
        let world = world_with_cube(&gpu, &config, true);
        let (_target, view) = gpu.target([320, 180]);

        let report = renderer.render_to_view(&gpu.device, &gpu.queue, &view, [320, 180], &world);
        assert_eq!(report.drawn, 1);
        assert_eq!(report.skipped, 0);

        let read = |channel| {
            gpu.block_on(renderer.gbuffer().read_texel(
                &gpu.device,
                &gpu.queue,
                channel,
                CENTER[0],
                CENTER[1],
            ))
            .unwrap()
        };
        // The camera looks down -Z at the front face, which sits at z = 0.5.
        let position = read(GBufferChannel::Position);
        assert!((position[2] - 0.5).abs() < 1e-2, "{position:?}");
        assert_texel_eq(read(GBufferChannel::Color), [1.0; 4], 1e-2);
        assert_texel_eq(read(GBufferChannel::Normal), [0.0, 0.0, 1.0, 0.0], 2e-2);
        assert_texel_eq(read(GBufferChannel::Tangent), [1.0, 0.0, 0.0, 0.0], 1e-2);
        assert_texel_eq(read(GBufferChannel::Bitangent), [0.0, 1.0, 0.0, 0.0], 1e-2);
        assert_eq!(gpu.errors.count(), 0);
    }

    #[test]
    fn screen_pass_shows_the_selected_channel() {
        let gpu = Gpu::new();
        let config = Config::default();
        let format = wgpu::TextureFormat::Rgba8Unorm;
        let mut renderer = DeferredRenderer::new(&gpu.device, format, &config).unwrap();
        let mut world = world_with_cube(&gpu, &config, true);
        let size = [320, 180];
        let (target, view) = gpu.target_with_format(size, format);

        let expected = [
            (GBufferChannel::Normal, [127, 127, 255]),
            (GBufferChannel::Tangent, [255, 128, 128]),
            (GBufferChannel::Bitangent, [128, 255, 128]),
            // Lit white surface facing the camera.
            (GBufferChannel::Color, [182, 182, 182]),
        ];
        for (channel, center) in expected {
            world.channel = channel;
            let report = renderer.render_to_view(&gpu.device, &gpu.queue, &view, size, &world);
            assert_eq!(report.drawn, 1);
            assert!(!report.pass_failed);
            let pixel = gpu.read_pixel(&target, size[0] / 2, size[1] / 2);
            assert_pixel_eq(pixel, center, 4);
            assert_eq!(pixel[3], 255);
        }

        // Background shows the unlit G-buffer clear colour.
        let corner = gpu.read_pixel(&target, 2, 2);
        let clear = config.gbuffer.clear_color.map(|c| (c * 255.0).round() as u8);
        assert_pixel_eq(corner, [clear[0], clear[1], clear[2]], 2);
        assert_eq!(gpu.errors.count(), 0);
    }

    #[test]
    fn replaced_gbuffer_is_picked_up_by_the_screen_pass() {
        let gpu = Gpu::new();
        let config = Config::default();
        let format = wgpu::TextureFormat::Rgba8Unorm;
        let mut renderer = DeferredRenderer::new(&gpu.device, format, &config).unwrap();
        let mut world = world_with_cube(&gpu, &config, true);
        world.channel = GBufferChannel::Normal;
        let size = [320, 180];
        let (target, view) = gpu.target_with_format(size, format);
        renderer.render_to_view(&gpu.device, &gpu.queue, &view, size, &world);

        // A fresh buffer has the same generation as the one it replaces.
        let replacement = GBuffer::new(&gpu.device, DEFAULT_GBUFFER_SIZE).unwrap();
        assert_eq!(replacement.generation(), renderer.gbuffer().generation());
        *renderer.gbuffer_mut() = replacement;

        let report = renderer.render_to_view(&gpu.device, &gpu.queue, &view, size, &world);
        assert_eq!(report.drawn, 1);
        assert!(!report.pass_failed);
        let color = gpu
            .block_on(renderer.gbuffer().read_texel(
                &gpu.device,
                &gpu.queue,
                GBufferChannel::Color,
                CENTER[0],
                CENTER[1],
            ))
            .unwrap();
        assert_texel_eq(color, [1.0; 4], 1e-2);
        let pixel = gpu.read_pixel(&target, size[0] / 2, size[1] / 2);
        assert_pixel_eq(pixel, [127, 127, 255], 4);
        assert_eq!(gpu.errors.count(), 0);
    }

    #[test]
    fn entity_without_material_is_skipped() {
        let gpu = Gpu::new();
        let config = Config::default();
        let format = wgpu::TextureFormat::Rgba8UnormSrgb;
        let mut renderer = DeferredRenderer::new(&gpu.device, format, &config).unwrap();
        let world = world_with_cube(&gpu, &config, false);
        let (_target, view) = gpu.target([64, 64]);

        let report = renderer.render_to_view(&gpu.device, &gpu.queue, &view, [64, 64], &world);
        assert_eq!(report.drawn, 0);
        assert_eq!(report.skipped, 1);
        assert!(!report.pass_failed);
    }

    #[test]
    fn draw_reports_missing_parameters() {
        let gpu = Gpu::new();
        let pipeline = GeometryPipeline::new(&gpu.device, &Shader::geometry(&gpu.device));
        let mut renderer = GeometryRenderer::new(&gpu.device, &pipeline, wgpu::Color::BLACK);
        let gbuffer = GBuffer::new(&gpu.device, [64, 64]).unwrap();
        let mesh = gpu.cube();
        let camera = Default::default();
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });

        let mut pass = renderer.setup(&gpu.device, &mut encoder, &gbuffer, 1).unwrap();
        let missing_mesh = pass.draw(RenderParams {
            pipeline: &pipeline,
            camera: &camera,
            mesh: None,
            material: None,
            transform: Transform::default(),
            parent_world: Default::default(),
        });
        assert!(matches!(missing_mesh, Err(RenderError::MissingParameter("mesh"))));
        let missing_material = pass.draw(RenderParams {
            pipeline: &pipeline,
            camera: &camera,
            mesh: Some(&mesh),
            material: None,
            transform: Transform::default(),
            parent_world: Default::default(),
        });
        assert!(matches!(
            missing_material,
            Err(RenderError::MissingParameter("material"))
        ));
        assert_eq!(pass.draw_count(), 0);
        assert_eq!(pass.cleanup(&gpu.queue), 0);
        gpu.queue.submit(std::iter::once(encoder.finish()));
    }

    #[test]
    fn destroyed_gbuffer_fails_the_passes() {
        let gpu = Gpu::new();
        let config = Config::default();
        let format = wgpu::TextureFormat::Rgba8UnormSrgb;
        let mut renderer = DeferredRenderer::new(&gpu.device, format, &config).unwrap();
        renderer.gbuffer_mut().destroy();
        let world = World::new(&config);
        let (_target, view) = gpu.target([64, 64]);

        let report = renderer.render_to_view(&gpu.device, &gpu.queue, &view, [64, 64], &world);
        assert!(report.pass_failed);
    }

    #[test]
    fn assets_load_from_the_asset_directory() {
        let gpu = Gpu::new();
        let mut world = World::new(&Config::default());
        let id = gpu
            .block_on(load_mesh_obj("cube.obj", &gpu.device, &mut world.assets))
            .unwrap();
        assert_eq!(world.assets.mesh(id).unwrap().num_elements, 36);
        assert!(
            gpu.block_on(load_mesh_obj("missing.obj", &gpu.device, &mut world.assets))
                .is_err()
        );
    }

    #[test]
    fn missing_textures_fall_back_to_placeholders() {
        let gpu = Gpu::new();
        let texture = gpu.block_on(load_texture_or_fallback(
            "missing.png",
            TextureKind::Diffuse,
            &gpu.device,
            &gpu.queue,
        ));
        assert_eq!(texture.size(), [1, 1]);

        let material = gpu.block_on(load_material(
            "missing",
            "missing.png",
            None,
            None,
            &gpu.device,
            &gpu.queue,
        ));
        assert_eq!(material.normal_texture.size(), [1, 1]);
        assert_eq!(material.normal_texture.format(), wgpu::TextureFormat::Rgba8Unorm);
    }
}
