//! GPU context holding the device and queue.
//!
//! The [`GpuContext`] is created once by the application (or wrapped around
//! a device the host already owns) and passed explicitly to everything that
//! allocates or submits GPU work. There is no process-wide instance.

use tracing::{debug, info};

use crate::error::{RenderError, RenderResult};

/// Configuration options for [`GpuContext::new`].
#[derive(Debug, Clone)]
pub struct GraphicsConfig {
    /// Preferred GPU backends to use.
    pub backends: wgpu::Backends,
    /// Power preference for adapter selection.
    pub power_preference: wgpu::PowerPreference,
    /// Required device features.
    pub required_features: wgpu::Features,
    /// Required device limits.
    pub required_limits: wgpu::Limits,
    /// Enable debug validation layers.
    pub debug_validation: bool,
}

impl GraphicsConfig {
    /// Set the backends to choose an adapter from.
    pub fn with_backends(mut self, backends: wgpu::Backends) -> Self {
        self.backends = backends;
        self
    }

    /// Set the adapter power preference.
    pub fn with_power_preference(mut self, preference: wgpu::PowerPreference) -> Self {
        self.power_preference = preference;
        self
    }

    /// Enable or disable validation layers.
    pub fn with_debug_validation(mut self, enabled: bool) -> Self {
        self.debug_validation = enabled;
        self
    }
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::PRIMARY,
            power_preference: wgpu::PowerPreference::HighPerformance,
            required_features: wgpu::Features::empty(),
            required_limits: if cfg!(target_arch = "wasm32") {
                wgpu::Limits::downlevel_webgl2_defaults()
            } else {
                wgpu::Limits::default()
            },
            debug_validation: cfg!(debug_assertions),
        }
    }
}

/// Device and queue shared by every pass.
pub struct GpuContext {
    instance: Option<wgpu::Instance>,
    adapter: Option<wgpu::Adapter>,
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl GpuContext {
    /// Create an instance, pick an adapter and request a device.
    ///
    /// No surface is required, so the context works headless.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::NoAdapter`] when no adapter matches and
    /// [`RenderError::DeviceRequest`] when device creation fails.
    pub fn new(config: &GraphicsConfig) -> RenderResult<Self> {
        let instance_flags = if config.debug_validation {
            wgpu::InstanceFlags::debugging()
        } else {
            wgpu::InstanceFlags::empty()
        };

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: config.backends,
            flags: instance_flags,
            ..Default::default()
        });

        info!(
            target: "glyphcast_render::context",
            backends = ?config.backends,
            "created wgpu instance"
        );

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: config.power_preference,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or(RenderError::NoAdapter)?;

        let adapter_info = adapter.get_info();
        info!(
            target: "glyphcast_render::context",
            name = adapter_info.name,
            backend = ?adapter_info.backend,
            device_type = ?adapter_info.device_type,
            "selected graphics adapter"
        );

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("glyphcast-device"),
                required_features: config.required_features,
                required_limits: config.required_limits.clone(),
                memory_hints: wgpu::MemoryHints::Performance,
            },
            None,
        ))?;

        debug!(
            target: "glyphcast_render::context",
            "created graphics device and queue"
        );

        Ok(Self {
            instance: Some(instance),
            adapter: Some(adapter),
            device,
            queue,
        })
    }

    /// Wrap a device and queue created by the host application.
    pub fn from_device(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            instance: None,
            adapter: None,
            device,
            queue,
        }
    }

    /// Get the logical device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Get the command queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// The wgpu instance, if this context created it.
    pub fn instance(&self) -> Option<&wgpu::Instance> {
        self.instance.as_ref()
    }

    /// The adapter, if this context selected it.
    pub fn adapter(&self) -> Option<&wgpu::Adapter> {
        self.adapter.as_ref()
    }

    /// Largest 2D texture dimension the device accepts.
    pub fn max_texture_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    /// Poll the device for completed work.
    pub fn poll(&self, maintain: wgpu::Maintain) -> wgpu::MaintainResult {
        self.device.poll(maintain)
    }
}

impl std::fmt::Debug for GpuContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("GpuContext");
        if let Some(adapter) = &self.adapter {
            let info = adapter.get_info();
            s.field("adapter", &info.name)
                .field("backend", &info.backend)
                .field("device_type", &info.device_type);
        }
        s.finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graphics_config_default() {
        let config = GraphicsConfig::default();
        assert_eq!(config.backends, wgpu::Backends::PRIMARY);
        assert_eq!(config.power_preference, wgpu::PowerPreference::HighPerformance);
        assert!(config.required_features.is_empty());
    }

    #[test]
    fn test_graphics_config_builder() {
        let config = GraphicsConfig::default()
            .with_backends(wgpu::Backends::VULKAN)
            .with_power_preference(wgpu::PowerPreference::LowPower)
            .with_debug_validation(false);
        assert_eq!(config.backends, wgpu::Backends::VULKAN);
        assert_eq!(config.power_preference, wgpu::PowerPreference::LowPower);
        assert!(!config.debug_validation);
    }

    #[test]
    #[ignore = "requires GPU"]
    fn test_context_creation() {
        let ctx = GpuContext::new(&GraphicsConfig::default()).unwrap();
        assert!(ctx.adapter().is_some());
        assert!(ctx.max_texture_dimension() >= 2048);
    }
}
