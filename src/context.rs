//! Window and GPU context.
//!
//! [`Context`] owns the window, the surface and its configuration, and the
//! device/queue pair every other part of the renderer borrows. Validation
//! errors the device reports asynchronously end up in an [`ErrorCounter`].

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use anyhow::Context as _;
use winit::window::Window;

use crate::{
    config::Config, data_structures::gbuffer::required_bytes_per_sample, error::SetupError,
    flow::FramePacing,
};

/// Number of uncaptured device errors seen so far. Clones share the count.
#[derive(Clone, Debug, Default)]
pub struct ErrorCounter(Arc<AtomicUsize>);

impl ErrorCounter {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }

    fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }
}

/// Log device errors instead of panicking, and count them.
pub fn install_error_handler(device: &wgpu::Device) -> ErrorCounter {
    let errors = ErrorCounter::default();
    let counter = errors.clone();
    let handler: Box<dyn wgpu::UncapturedErrorHandler> = Box::new(move |error: wgpu::Error| {
        counter.increment();
        log::error!("wgpu error: {}", error);
    });
    device.on_uncaptured_error(handler.into());
    errors
}

/// Limits the G-buffer needs on top of the defaults.
fn required_limits(adapter: &wgpu::Adapter) -> Result<wgpu::Limits, SetupError> {
    let required = required_bytes_per_sample();
    let supported = adapter.limits().max_color_attachment_bytes_per_sample;
    if supported < required {
        return Err(SetupError::UnsupportedLimits {
            required,
            supported,
        });
    }
    let mut limits = wgpu::Limits::default();
    limits.max_color_attachment_bytes_per_sample =
        limits.max_color_attachment_bytes_per_sample.max(required);
    Ok(limits)
}

async fn request_device(adapter: &wgpu::Adapter) -> anyhow::Result<(wgpu::Device, wgpu::Queue)> {
    let info = adapter.get_info();
    log::info!("Using {} ({:?})", info.name, info.backend);
    let required_limits = required_limits(adapter)?;
    adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("deferred-ngin device"),
            required_features: wgpu::Features::empty(),
            required_limits,
            ..Default::default()
        })
        .await
        .map_err(|e| SetupError::Device(e.to_string()).into())
}

/// A device without a window, for tests and offscreen work.
pub async fn headless_device() -> anyhow::Result<(wgpu::Device, wgpu::Queue, ErrorCounter)> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
        .context(SetupError::NoAdapter)?;
    let (device, queue) = request_device(&adapter).await?;
    let errors = install_error_handler(&device);
    Ok((device, queue, errors))
}

#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub errors: ErrorCounter,
    is_surface_configured: bool,
}

impl Context {
    pub async fn new(window: Arc<Window>, pacing: FramePacing) -> anyhow::Result<Self> {
        let size = window.inner_size();

        // The instance is a handle to our GPU
        // BackendBit::PRIMARY => Vulkan + Metal + DX12 + Browser WebGPU
        log::debug!("WGPU setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| SetupError::Surface(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context(SetupError::NoAdapter)?;
        let (device, queue) = request_device(&adapter).await?;
        let errors = install_error_handler(&device);

        let surface_caps = surface.get_capabilities(&adapter);
        // The screen shader writes linear colour and relies on an sRGB surface for the encoding.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| SetupError::Surface("surface reports no formats".to_string()))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: present_mode(pacing),
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            errors,
            is_surface_configured: false,
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Live size of the surface in pixels.
    pub fn size(&self) -> [u32; 2] {
        [self.config.width, self.config.height]
    }

    pub fn is_surface_configured(&self) -> bool {
        self.is_surface_configured
    }

    /// Reconfigure the surface. Zero sizes (minimised windows) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);
            self.is_surface_configured = true;
        }
    }
}

fn present_mode(pacing: FramePacing) -> wgpu::PresentMode {
    match pacing {
        FramePacing::VSync => wgpu::PresentMode::AutoVsync,
        FramePacing::Limited { .. } | FramePacing::Unlimited => wgpu::PresentMode::AutoNoVsync,
    }
}

/// What a world constructor gets to build GPU resources with.
///
/// Device and queue are reference counted, cloning them only clones the handle.
#[derive(Clone, Debug)]
pub struct InitContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub surface_format: wgpu::TextureFormat,
    pub config: Config,
}

impl InitContext {
    pub fn new(ctx: &Context, config: &Config) -> Self {
        Self {
            device: ctx.device.clone(),
            queue: ctx.queue.clone(),
            surface_format: ctx.config.format,
            config: config.clone(),
        }
    }
}
