//! GPU textures and texture creation utilities.
//!
//! This module provides [`Texture`], a wrapper around WGPU texture resources,
//! and helpers for creating G-buffer attachments, flat fallback maps, and
//! textures decoded from image data.

use anyhow::*;
use image::{GenericImageView, ImageFormat, load_from_memory_with_format};

/// What a sampled texture is used for. Decides the colour space of the upload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureKind {
    /// Albedo, stored as sRGB.
    Diffuse,
    /// Tangent-space normal map, linear.
    Normal,
    /// Height/displacement map, linear.
    Height,
}

/// A GPU texture with a view and optional sampler.
///
/// Cloning is cheap: the underlying WGPU objects are reference counted, so two
/// clones refer to the same GPU memory.
#[derive(Clone, Debug)]
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: Option<wgpu::Sampler>,
}

impl Texture {
    /// Depth-stencil format of the G-buffer. Stencil is reserved for later passes.
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;

    /// 16 bits per channel, signed and unbounded so world positions fit.
    pub const GBUFFER_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

    /// Create a render target that can also be sampled by a later pass.
    pub fn create_color_attachment(
        device: &wgpu::Device,
        size: [u32; 2],
        format: wgpu::TextureFormat,
        label: &str,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent(size),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            sampler: None,
        }
    }

    /// Create the depth-stencil attachment used for depth testing in the geometry pass.
    ///
    /// # Arguments
    ///
    /// * `size` is [width, height] of the texture in pixels
    /// * `label` is used as a debug label for the GPU resource
    pub fn create_depth_texture(device: &wgpu::Device, size: [u32; 2], label: &str) -> Self {
        let desc = wgpu::TextureDescriptor {
            label: Some(label),
            size: extent(size),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        };
        let texture = device.create_texture(&desc);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            sampler: None,
        }
    }

    /// Create a texture filled with one RGBA8 value.
    ///
    /// Used for neutral maps (flat normal map, zero height) and for the
    /// placeholder returned when an image fails to load.
    pub fn create_solid(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rgba: [u8; 4],
        kind: TextureKind,
        label: &str,
    ) -> Texture {
        let width = 1;
        let height = 1;
        let size = extent([width, height]);
        let format = rgba_format(kind);

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            &rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = Some(create_default_sampler(device));
        Texture {
            texture,
            view,
            sampler,
        }
    }

    /// Create a default normal map (neutral blue, representing no deformation).
    pub fn create_default_normal_map(device: &wgpu::Device, queue: &wgpu::Queue) -> Texture {
        // The blue/purple-ish colour that represents the default for normal maps
        Self::create_solid(
            device,
            queue,
            [127, 127, 255, 255],
            TextureKind::Normal,
            "default normal map",
        )
    }

    /// Create a flat height map.
    pub fn create_default_height_map(device: &wgpu::Device, queue: &wgpu::Queue) -> Texture {
        Self::create_solid(device, queue, [0, 0, 0, 255], TextureKind::Height, "default height map")
    }

    /// Load a texture from raw byte data (image file contents).
    ///
    /// # Arguments
    ///
    /// * `bytes` represent raw image file data (PNG, JPEG, etc.)
    /// * `label` is used as a debug name for the GPU resource
    /// * `format` is an optional file extension hint (e.g. "png"). If None, auto-detect.
    /// * `kind` selects sRGB (diffuse) or linear (normal, height) storage
    pub fn from_bytes(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        bytes: &[u8],
        label: &str,
        format: Option<&str>,
        kind: TextureKind,
    ) -> Result<Self> {
        let img = match format {
            None => image::load_from_memory(bytes)?,
            Some(fmt) => {
                let fmt = ImageFormat::from_extension(fmt)
                    .with_context(|| format!("unknown image format '{fmt}' for {label}"))?;
                load_from_memory_with_format(bytes, fmt)?
            }
        };
        Self::from_image(device, queue, &img, Some(label), kind)
    }

    /// Upload a decoded image. Single-channel images stay single-channel
    /// (`R8Unorm`), everything else is expanded to RGBA8.
    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        img: &image::DynamicImage,
        label: Option<&str>,
        kind: TextureKind,
    ) -> Result<Self> {
        let dimensions = img.dimensions();
        if dimensions.0 == 0 || dimensions.1 == 0 {
            bail!("image {:?} has no pixels", label);
        }
        let format = upload_format(img.color().channel_count(), kind);
        let (data, bytes_per_pixel) = match format {
            wgpu::TextureFormat::R8Unorm => (img.to_luma8().into_raw(), 1),
            _ => (img.to_rgba8().into_raw(), 4),
        };

        let size = extent([dimensions.0, dimensions.1]);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            &data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_pixel * dimensions.0),
                rows_per_image: Some(dimensions.1),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = Some(create_default_sampler(device));

        Ok(Self {
            texture,
            view,
            sampler,
        })
    }

    pub fn size(&self) -> [u32; 2] {
        [self.texture.width(), self.texture.height()]
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.texture.format()
    }
}

/// Texture format chosen for an image with `channels` channels.
pub fn upload_format(channels: u8, kind: TextureKind) -> wgpu::TextureFormat {
    match channels {
        1 => wgpu::TextureFormat::R8Unorm,
        _ => rgba_format(kind),
    }
}

fn rgba_format(kind: TextureKind) -> wgpu::TextureFormat {
    match kind {
        TextureKind::Diffuse => wgpu::TextureFormat::Rgba8UnormSrgb,
        TextureKind::Normal | TextureKind::Height => wgpu::TextureFormat::Rgba8Unorm,
    }
}

fn extent(size: [u32; 2]) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: size[0].max(1),
        height: size[1].max(1),
        depth_or_array_layers: 1,
    }
}

pub fn create_default_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("material sampler"),
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_count_selects_format() {
        assert_eq!(upload_format(1, TextureKind::Height), wgpu::TextureFormat::R8Unorm);
        assert_eq!(upload_format(3, TextureKind::Diffuse), wgpu::TextureFormat::Rgba8UnormSrgb);
        assert_eq!(upload_format(4, TextureKind::Normal), wgpu::TextureFormat::Rgba8Unorm);
    }
}
