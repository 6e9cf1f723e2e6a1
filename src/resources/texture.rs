use std::path::Path;

use crate::{
    data_structures::{
        model::Material,
        texture::{self, TextureKind},
    },
    resources::load_binary,
};

/// Bind group layout of a [`Material`]: diffuse, normal and height maps at
/// bindings 0 to 2, the sampler at binding 3.
pub fn material_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension: wgpu::TextureViewDimension::D2,
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
        },
        count: None,
    };
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            texture_entry(0),
            texture_entry(1),
            texture_entry(2),
            wgpu::BindGroupLayoutEntry {
                binding: 3,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("Material texture_bind_group_layout"),
    })
}

pub async fn load_texture(
    file_name: &str,
    kind: TextureKind,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<texture::Texture> {
    let data = load_binary(file_name).await?;
    let extension = Path::new(file_name).extension().and_then(|e| e.to_str());
    texture::Texture::from_bytes(device, queue, &data, file_name, extension, kind)
}

/// Placeholder colour of textures that failed to load.
fn fallback_color(kind: TextureKind) -> [u8; 4] {
    match kind {
        TextureKind::Diffuse => [255, 0, 255, 255],
        TextureKind::Normal => [127, 127, 255, 255],
        TextureKind::Height => [0, 0, 0, 255],
    }
}

/// Like [`load_texture`], but a failure is logged and yields a 1×1 placeholder.
pub async fn load_texture_or_fallback(
    file_name: &str,
    kind: TextureKind,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> texture::Texture {
    match load_texture(file_name, kind, device, queue).await {
        Ok(texture) => texture,
        Err(err) => {
            log::error!("Texture {file_name} could not be loaded: {:#}", err);
            texture::Texture::create_solid(
                device,
                queue,
                fallback_color(kind),
                kind,
                &format!("{file_name} (fallback)"),
            )
        }
    }
}

/// Build a material from image files. Missing normal or height maps are
/// replaced by neutral ones; unreadable files by placeholders.
pub async fn load_material(
    name: &str,
    diffuse: &str,
    normal: Option<&str>,
    height: Option<&str>,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> Material {
    let diffuse_texture =
        load_texture_or_fallback(diffuse, TextureKind::Diffuse, device, queue).await;
    let normal_texture = match normal {
        Some(file_name) => {
            load_texture_or_fallback(file_name, TextureKind::Normal, device, queue).await
        }
        None => texture::Texture::create_default_normal_map(device, queue),
    };
    let height_texture = match height {
        Some(file_name) => {
            load_texture_or_fallback(file_name, TextureKind::Height, device, queue).await
        }
        None => texture::Texture::create_default_height_map(device, queue),
    };
    Material::new(
        device,
        name,
        diffuse_texture,
        normal_texture,
        height_texture,
        &material_layout(device),
    )
}
