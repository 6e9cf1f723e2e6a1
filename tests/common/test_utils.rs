#![allow(dead_code)]

use deferred_ngin::{
    context::{ErrorCounter, headless_device},
    data_structures::{
        model::{Material, Mesh},
        texture::{Texture, TextureKind},
    },
    resources::{mesh::parse_obj, texture::material_layout},
};

pub(crate) const CUBE_OBJ: &str = include_str!("../../assets/cube.obj");

pub(crate) struct Gpu {
    pub(crate) runtime: tokio::runtime::Runtime,
    pub(crate) device: wgpu::Device,
    pub(crate) queue: wgpu::Queue,
    pub(crate) errors: ErrorCounter,
}

impl Gpu {
    pub(crate) fn new() -> Self {
        let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
        let (device, queue, errors) = runtime
            .block_on(headless_device())
            .expect("no GPU adapter for integration tests");
        Self {
            runtime,
            device,
            queue,
            errors,
        }
    }

    pub(crate) fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Offscreen texture standing in for the window surface.
    pub(crate) fn target(&self, size: [u32; 2]) -> (wgpu::Texture, wgpu::TextureView) {
        self.target_with_format(size, wgpu::TextureFormat::Rgba8UnormSrgb)
    }

    pub(crate) fn target_with_format(
        &self,
        size: [u32; 2],
        format: wgpu::TextureFormat,
    ) -> (wgpu::Texture, wgpu::TextureView) {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("test target"),
            size: wgpu::Extent3d {
                width: size[0],
                height: size[1],
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        (texture, view)
    }

    /// One pixel of an 8-bit RGBA target.
    pub(crate) fn read_pixel(&self, texture: &wgpu::Texture, x: u32, y: u32) -> [u8; 4] {
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("test readback"),
            size: wgpu::COPY_BYTES_PER_ROW_ALIGNMENT as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d { x, y, z: 0 },
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT),
                    rows_per_image: Some(1),
                },
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = buffer.slice(..);
        let (tx, rx) = futures::channel::oneshot::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            tx.send(result).ok();
        });
        self.device
            .poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: None,
            })
            .expect("device poll");
        self.block_on(rx)
            .expect("readback callback dropped")
            .expect("readback mapping");
        let data = slice.get_mapped_range();
        [data[0], data[1], data[2], data[3]]
    }

    pub(crate) fn cube(&self) -> Mesh {
        let (vertices, indices) = self.block_on(parse_obj(CUBE_OBJ)).expect("cube parses");
        Mesh::new(&self.device, "cube", &vertices, &indices)
    }

    pub(crate) fn solid_material(&self, rgba: [u8; 4]) -> Material {
        Material::new(
            &self.device,
            "solid",
            Texture::create_solid(&self.device, &self.queue, rgba, TextureKind::Diffuse, "solid"),
            Texture::create_default_normal_map(&self.device, &self.queue),
            Texture::create_default_height_map(&self.device, &self.queue),
            &material_layout(&self.device),
        )
    }
}

pub(crate) fn assert_pixel_eq(actual: [u8; 4], expected: [u8; 3], tolerance: u8) {
    for (a, e) in actual.iter().zip(expected) {
        assert!(a.abs_diff(e) <= tolerance, "{actual:?} != {expected:?}");
    }
}

pub(crate) fn assert_texel_eq(actual: [f32; 4], expected: [f32; 4], epsilon: f32) {
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() <= epsilon, "{actual:?} != {expected:?}");
    }
}
