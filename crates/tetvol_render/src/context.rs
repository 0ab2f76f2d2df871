//! WGPU device acquisition
//!
//! The renderer never presents to a window, so the context is just an
//! adapter, a device and its queue.

use std::fmt;

/// Errors while acquiring a GPU device
#[derive(Debug)]
pub enum ContextError {
    /// No adapter matched the request
    NoAdapter,
    /// The adapter refused to create a device
    Device(wgpu::RequestDeviceError),
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextError::NoAdapter => write!(f, "No suitable GPU adapter found"),
            ContextError::Device(err) => write!(f, "Failed to create device: {}", err),
        }
    }
}

impl std::error::Error for ContextError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ContextError::Device(err) => Some(err),
            ContextError::NoAdapter => None,
        }
    }
}

impl From<wgpu::RequestDeviceError> for ContextError {
    fn from(err: wgpu::RequestDeviceError) -> Self {
        ContextError::Device(err)
    }
}

/// Device, queue and what they run on
pub struct RenderContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_info: wgpu::AdapterInfo,
}

impl RenderContext {
    /// Acquire a device without a surface
    pub async fn headless() -> Result<Self, ContextError> {
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
            .ok_or(ContextError::NoAdapter)?;

        let adapter_info = adapter.get_info();
        log::info!("Using adapter {} ({:?})", adapter_info.name, adapter_info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Tetvol Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits()),
                    ..Default::default()
                },
                None,
            )
            .await?;

        Ok(Self { device, queue, adapter_info })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_error_display() {
        assert_eq!(format!("{}", ContextError::NoAdapter), "No suitable GPU adapter found");
    }
}
