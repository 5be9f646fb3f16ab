//! GPU buffers that grow to fit per-frame data.

use tracing::debug;

/// A vertex/index/instance buffer reallocated at the next power of two
/// whenever a frame's data does not fit.
pub(crate) struct GrowableBuffer {
    buffer: wgpu::Buffer,
    capacity: u64,
    label: &'static str,
    usage: wgpu::BufferUsages,
}

impl GrowableBuffer {
    /// Create a buffer holding at least `capacity` bytes.
    pub(crate) fn new(
        device: &wgpu::Device,
        label: &'static str,
        usage: wgpu::BufferUsages,
        capacity: u64,
    ) -> Self {
        let capacity = grown_capacity(capacity);
        let usage = usage | wgpu::BufferUsages::COPY_DST;
        Self {
            buffer: create(device, label, usage, capacity),
            capacity,
            label,
            usage,
        }
    }

    /// Copy `data` to the start of the buffer, growing it first if needed.
    ///
    /// The data is copied at call time, so the caller may reuse its slice
    /// immediately.
    pub(crate) fn write(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, data: &[u8]) {
        let needed = data.len() as u64;
        if needed > self.capacity {
            let capacity = grown_capacity(needed);
            debug!(
                target: "glyphcast_render::buffer",
                label = self.label,
                from = self.capacity,
                to = capacity,
                "growing buffer"
            );
            self.buffer = create(device, self.label, self.usage, capacity);
            self.capacity = capacity;
        }
        if !data.is_empty() {
            queue.write_buffer(&self.buffer, 0, data);
        }
    }

    pub(crate) fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }
}

fn create(
    device: &wgpu::Device,
    label: &'static str,
    usage: wgpu::BufferUsages,
    size: u64,
) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size,
        usage,
        mapped_at_creation: false,
    })
}

/// Next power of two at or above `needed`, never below 256 bytes.
///
/// Powers of two from 256 up keep `write_buffer`'s 4-byte alignment.
pub(crate) fn grown_capacity(needed: u64) -> u64 {
    needed.max(256).next_power_of_two()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grown_capacity() {
        assert_eq!(grown_capacity(0), 256);
        assert_eq!(grown_capacity(256), 256);
        assert_eq!(grown_capacity(257), 512);
        assert_eq!(grown_capacity(5000), 8192);
    }
}
