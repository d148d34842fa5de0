//! Device and queue acquisition.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

/// Errors raised while acquiring a GPU device.
#[derive(Error, Debug)]
pub enum GpuError {
    /// No adapter matched the request.
    #[error("no suitable graphics adapter found")]
    NoAdapter,

    /// The adapter refused to create a device.
    #[error("failed to create graphics device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
}

/// A device and its queue.
///
/// Either wraps handles owned by the application's renderer, or requests
/// its own device for offscreen use.
#[derive(Clone)]
pub struct GpuContext {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
}

impl GpuContext {
    /// Share the device and queue the application already renders with.
    pub fn from_parts(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Self {
        Self { device, queue }
    }

    /// Request a device without a surface, blocking until it is ready.
    pub fn headless() -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::LowPower,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or(GpuError::NoAdapter)?;

        let adapter_info = adapter.get_info();
        info!(
            target: "lowram_text_wgpu::context",
            name = adapter_info.name,
            backend = ?adapter_info.backend,
            "selected graphics adapter"
        );

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("lowram-text-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
                memory_hints: wgpu::MemoryHints::MemoryUsage,
            },
            None,
        ))?;

        debug!(target: "lowram_text_wgpu::context", "created graphics device and queue");

        Ok(Self::from_parts(Arc::new(device), Arc::new(queue)))
    }

    pub fn device(&self) -> &Arc<wgpu::Device> {
        &self.device
    }

    pub fn queue(&self) -> &Arc<wgpu::Queue> {
        &self.queue
    }
}

impl std::fmt::Debug for GpuContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuContext")
            .field("max_texture_dimension_2d", &self.device.limits().max_texture_dimension_2d)
            .finish_non_exhaustive()
    }
}
