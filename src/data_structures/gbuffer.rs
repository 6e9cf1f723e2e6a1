//! The G-buffer: five floating point colour attachments plus depth-stencil.
//!
//! The geometry pass renders into all five attachments at once, the screen
//! pass samples them afterwards. The resolution is fixed at creation and only
//! changes through [`GBuffer::resize`].

use half::f16;

use crate::{data_structures::texture::Texture, error::RenderError};

/// Resolution used when nothing else is configured.
pub const DEFAULT_GBUFFER_SIZE: [u32; 2] = [1600, 900];

/// Number of colour attachments.
pub const CHANNEL_COUNT: usize = 5;

/// One colour attachment of the G-buffer. The discriminant is the attachment slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GBufferChannel {
    Position = 0,
    #[default]
    Color = 1,
    Tangent = 2,
    Bitangent = 3,
    Normal = 4,
}

impl GBufferChannel {
    /// All channels in slot order.
    pub const ALL: [GBufferChannel; CHANNEL_COUNT] = [
        GBufferChannel::Position,
        GBufferChannel::Color,
        GBufferChannel::Tangent,
        GBufferChannel::Bitangent,
        GBufferChannel::Normal,
    ];

    pub fn slot(self) -> usize {
        self as usize
    }

    /// Value the screen shader switches on.
    pub fn select(self) -> u32 {
        self as u32
    }

    /// The channel after this one, wrapping around.
    pub fn next(self) -> Self {
        Self::ALL[(self.slot() + 1) % CHANNEL_COUNT]
    }

    pub fn label(self) -> &'static str {
        match self {
            GBufferChannel::Position => "position",
            GBufferChannel::Color => "color",
            GBufferChannel::Tangent => "tangent",
            GBufferChannel::Bitangent => "bitangent",
            GBufferChannel::Normal => "normal",
        }
    }
}

/// What the completeness check needs to know about an attachment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttachmentDesc {
    pub slot: usize,
    pub size: [u32; 2],
    pub format: wgpu::TextureFormat,
}

/// Validates a set of attachments the way a framebuffer completeness check would.
///
/// `colors` is indexed by slot. Every slot must be filled by an attachment that
/// claims that slot, all attachments share one non-zero size, colour formats
/// are colour-renderable, the depth format has a depth aspect, and the colour
/// targets together stay within `max_bytes_per_sample`.
pub fn check_completeness(
    colors: &[Option<AttachmentDesc>],
    depth: Option<AttachmentDesc>,
    max_bytes_per_sample: u32,
) -> Result<(), String> {
    if colors.len() != CHANNEL_COUNT {
        return Err(format!(
            "expected {CHANNEL_COUNT} colour attachments, got {}",
            colors.len()
        ));
    }
    let depth = depth.ok_or_else(|| "missing depth attachment".to_string())?;
    if !depth.format.has_depth_aspect() {
        return Err(format!("{:?} is not a depth format", depth.format));
    }
    let size = depth.size;
    if size[0] == 0 || size[1] == 0 {
        return Err(format!("zero sized attachment {}x{}", size[0], size[1]));
    }

    let mut bytes_per_sample = 0u32;
    for (slot, attachment) in colors.iter().enumerate() {
        let attachment =
            attachment.ok_or_else(|| format!("missing colour attachment at slot {slot}"))?;
        if attachment.slot != slot {
            return Err(format!(
                "attachment for slot {} is bound at slot {slot}",
                attachment.slot
            ));
        }
        if attachment.size != size {
            return Err(format!(
                "attachment at slot {slot} is {:?}, depth is {:?}",
                attachment.size, size
            ));
        }
        if attachment.format.is_depth_stencil_format() {
            return Err(format!(
                "{:?} at slot {slot} is not colour-renderable",
                attachment.format
            ));
        }
        let cost = attachment
            .format
            .target_pixel_byte_cost()
            .ok_or_else(|| format!("{:?} at slot {slot} is not renderable", attachment.format))?;
        let alignment = attachment.format.target_component_alignment().unwrap_or(1);
        bytes_per_sample = bytes_per_sample.next_multiple_of(alignment) + cost;
    }
    if bytes_per_sample > max_bytes_per_sample {
        return Err(format!(
            "{bytes_per_sample} bytes per sample exceed the limit of {max_bytes_per_sample}"
        ));
    }
    Ok(())
}

/// Bytes per sample the G-buffer layout needs from the device.
pub fn required_bytes_per_sample() -> u32 {
    let cost = Texture::GBUFFER_FORMAT.target_pixel_byte_cost().unwrap_or(8);
    cost * CHANNEL_COUNT as u32
}

#[derive(Debug)]
pub struct GBuffer {
    attachments: Vec<Texture>,
    depth: Option<Texture>,
    size: [u32; 2],
    generation: u64,
    max_bytes_per_sample: u32,
}

impl GBuffer {
    /// Allocate all attachments and verify completeness once.
    pub fn new(device: &wgpu::Device, size: [u32; 2]) -> Result<Self, RenderError> {
        let limits = device.limits();
        let (attachments, depth) = allocate(device, size, limits.max_texture_dimension_2d)?;
        let gbuffer = Self {
            attachments,
            depth: Some(depth),
            size,
            generation: 0,
            max_bytes_per_sample: limits.max_color_attachment_bytes_per_sample,
        };
        gbuffer.verify()?;
        log::info!("G-buffer created at {}x{}", size[0], size[1]);
        Ok(gbuffer)
    }

    fn descriptions(&self) -> (Vec<Option<AttachmentDesc>>, Option<AttachmentDesc>) {
        let colors = (0..CHANNEL_COUNT)
            .map(|slot| {
                self.attachments.get(slot).map(|texture| AttachmentDesc {
                    slot,
                    size: texture.size(),
                    format: texture.format(),
                })
            })
            .collect();
        let depth = self.depth.as_ref().map(|texture| AttachmentDesc {
            slot: 0,
            size: texture.size(),
            format: texture.format(),
        });
        (colors, depth)
    }

    fn verify(&self) -> Result<(), RenderError> {
        let (colors, depth) = self.descriptions();
        check_completeness(&colors, depth, self.max_bytes_per_sample)
            .map_err(RenderError::IncompleteFramebuffer)
    }

    pub fn is_complete(&self) -> bool {
        self.verify().is_ok()
    }

    /// The fixed resolution, independent of the window.
    pub fn size(&self) -> [u32; 2] {
        self.size
    }

    /// Number of times the attachments were replaced, starting at 0.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Replace all attachments with new ones of `size`.
    pub fn resize(&mut self, device: &wgpu::Device, size: [u32; 2]) -> Result<(), RenderError> {
        let max_dimension = device.limits().max_texture_dimension_2d;
        let (attachments, depth) = allocate(device, size, max_dimension)?;
        self.destroy();
        self.attachments = attachments;
        self.depth = Some(depth);
        self.size = size;
        self.generation += 1;
        self.verify()?;
        log::debug!("G-buffer resized to {}x{}", size[0], size[1]);
        Ok(())
    }

    pub fn attachment(&self, channel: GBufferChannel) -> Option<&Texture> {
        self.attachments.get(channel.slot())
    }

    pub fn depth(&self) -> Option<&Texture> {
        self.depth.as_ref()
    }

    /// Views of all colour attachments in slot order.
    pub fn views(&self) -> Option<[&wgpu::TextureView; CHANNEL_COUNT]> {
        if self.attachments.len() != CHANNEL_COUNT {
            return None;
        }
        Some(std::array::from_fn(|slot| &self.attachments[slot].view))
    }

    pub fn is_destroyed(&self) -> bool {
        self.depth.is_none()
    }

    /// Release the GPU memory of all attachments.
    pub fn destroy(&mut self) {
        for attachment in self.attachments.drain(..) {
            attachment.texture.destroy();
        }
        if let Some(depth) = self.depth.take() {
            depth.texture.destroy();
        }
    }

    /// Colour attachments in slot order, cleared to `clear`.
    pub fn color_attachments(
        &self,
        clear: wgpu::Color,
    ) -> Result<[Option<wgpu::RenderPassColorAttachment<'_>>; CHANNEL_COUNT], RenderError> {
        let views = self.views().ok_or(RenderError::Destroyed)?;
        Ok(views.map(|view| {
            Some(wgpu::RenderPassColorAttachment {
                view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear),
                    store: wgpu::StoreOp::Store,
                },
            })
        }))
    }

    /// Depth cleared to 1.0, stencil cleared to 0.
    pub fn depth_stencil_attachment(
        &self,
    ) -> Result<wgpu::RenderPassDepthStencilAttachment<'_>, RenderError> {
        let depth = self.depth.as_ref().ok_or(RenderError::Destroyed)?;
        Ok(wgpu::RenderPassDepthStencilAttachment {
            view: &depth.view,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(1.0),
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(0),
                store: wgpu::StoreOp::Store,
            }),
        })
    }

    /// Copy one texel of `channel` back to the CPU. Blocks on the device.
    pub async fn read_texel(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        channel: GBufferChannel,
        x: u32,
        y: u32,
    ) -> anyhow::Result<[f32; 4]> {
        let attachment = self.attachment(channel).ok_or(RenderError::Destroyed)?;
        if x >= self.size[0] || y >= self.size[1] {
            anyhow::bail!("texel ({x}, {y}) is outside of {:?}", self.size);
        }

        let output_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("G-buffer readback"),
            size: wgpu::COPY_BYTES_PER_ROW_ALIGNMENT as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("G-buffer readback encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &attachment.texture,
                mip_level: 0,
                origin: wgpu::Origin3d { x, y, z: 0 },
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &output_buffer,
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
        queue.submit(std::iter::once(encoder.finish()));

        let buffer_slice = output_buffer.slice(..);
        // The mapping has to be requested before polling, otherwise the wait never ends.
        let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            tx.send(result).ok();
        });
        device.poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: None,
        })?;
        match rx.receive().await {
            Some(result) => result?,
            None => anyhow::bail!("readback channel closed before the buffer was mapped"),
        }

        let texel = decode_texel(&buffer_slice.get_mapped_range());
        output_buffer.unmap();
        Ok(texel)
    }
}

impl Drop for GBuffer {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn allocate(
    device: &wgpu::Device,
    size: [u32; 2],
    max_dimension: u32,
) -> Result<(Vec<Texture>, Texture), RenderError> {
    if size[0] == 0 || size[1] == 0 || size[0] > max_dimension || size[1] > max_dimension {
        return Err(RenderError::IncompleteFramebuffer(format!(
            "{}x{} is outside of 1..={max_dimension}",
            size[0], size[1]
        )));
    }
    let attachments = GBufferChannel::ALL
        .iter()
        .map(|channel| {
            Texture::create_color_attachment(
                device,
                size,
                Texture::GBUFFER_FORMAT,
                &format!("G-buffer {}", channel.label()),
            )
        })
        .collect();
    let depth = Texture::create_depth_texture(device, size, "G-buffer depth");
    Ok((attachments, depth))
}

/// Four little-endian half floats, as stored by [`Texture::GBUFFER_FORMAT`].
fn decode_texel(data: &[u8]) -> [f32; 4] {
    std::array::from_fn(|i| f16::from_le_bytes([data[i * 2], data[i * 2 + 1]]).to_f32())
}
