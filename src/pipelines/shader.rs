//! WGSL shader modules.
//!
//! Compilation problems are not returned here: the device reports them to
//! its uncaptured error handler (see [`crate::context::install_error_handler`]),
//! which logs and counts them.

use crate::resources::load_string;

#[derive(Clone, Debug)]
pub struct Shader {
    pub label: String,
    pub module: wgpu::ShaderModule,
}

impl Shader {
    pub fn from_wgsl(device: &wgpu::Device, label: &str, source: &str) -> Self {
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        log::debug!("Compiled shader {label}");
        Self {
            label: label.to_string(),
            module,
        }
    }

    /// Load and compile a WGSL file from the asset directory.
    pub async fn from_file(device: &wgpu::Device, file_name: &str) -> anyhow::Result<Self> {
        let source = load_string(file_name).await?;
        Ok(Self::from_wgsl(device, file_name, &source))
    }

    pub fn geometry(device: &wgpu::Device) -> Self {
        Self::from_wgsl(device, "geometry shader", include_str!("geometry.wgsl"))
    }

    pub fn screen(device: &wgpu::Device) -> Self {
        Self::from_wgsl(device, "screen shader", include_str!("screen.wgsl"))
    }
}
