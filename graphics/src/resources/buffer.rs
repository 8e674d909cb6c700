//! GPU buffer resource.

use crate::backend::{gl, GpuBuffer};
use crate::device::DeviceId;
use crate::error::{GraphicsError, GraphicsResult};
use crate::types::{BufferDescriptor, BufferUsageFlags};

/// A GPU buffer resource.
///
/// Buffers are created by [`GraphicsDevice::create_buffer`] and shared with
/// `Arc`. Command buffers that reference a buffer keep it alive until they
/// are reset or dropped.
///
/// # Example
///
/// ```ignore
/// let buffer = device.create_buffer(&BufferDescriptor::new(1024, BufferUsageFlags::VERTEX))?;
/// println!("Buffer size: {}", buffer.size());
/// ```
///
/// [`GraphicsDevice::create_buffer`]: crate::GraphicsDevice::create_buffer
pub struct Buffer {
    device: DeviceId,
    descriptor: BufferDescriptor,
    pub(crate) gpu: GpuBuffer,
}

impl Buffer {
    /// Create a new buffer (called by GraphicsDevice).
    pub(crate) fn new(device: DeviceId, descriptor: BufferDescriptor, gpu: GpuBuffer) -> Self {
        Self {
            device,
            descriptor,
            gpu,
        }
    }

    /// The device that created this buffer.
    pub fn device_id(&self) -> DeviceId {
        self.device
    }

    /// Get the buffer descriptor.
    pub fn descriptor(&self) -> &BufferDescriptor {
        &self.descriptor
    }

    /// Get the buffer size in bytes.
    pub fn size(&self) -> u64 {
        self.descriptor.size
    }

    /// Get the buffer usage flags.
    pub fn usage(&self) -> BufferUsageFlags {
        self.descriptor.usage
    }

    /// Get the buffer label, if set.
    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }

    fn check_host_range(&self, offset: u64, len: u64) -> GraphicsResult<()> {
        if !self.descriptor.is_host_visible() {
            return Err(GraphicsError::InvalidParameter(format!(
                "buffer {:?} is not host visible",
                self.descriptor.label
            )));
        }
        match offset.checked_add(len) {
            Some(end) if end <= self.descriptor.size => Ok(()),
            _ => Err(GraphicsError::InvalidParameter(format!(
                "range {offset}+{len} exceeds buffer size {}",
                self.descriptor.size
            ))),
        }
    }

    /// Write `data` at `offset` from the host.
    ///
    /// # Errors
    ///
    /// Fails when the buffer is not host visible, the range is out of
    /// bounds, or the device is lost.
    pub fn write(&self, offset: u64, data: &[u8]) -> GraphicsResult<()> {
        self.check_host_range(offset, data.len() as u64)?;
        match &self.gpu {
            GpuBuffer::Test { memory } => {
                let start = offset as usize;
                memory.lock()[start..start + data.len()].copy_from_slice(data);
                Ok(())
            }
            GpuBuffer::Gl { context, name } => gl::write_buffer(context, *name, offset, data),
            #[cfg(feature = "vulkan-backend")]
            GpuBuffer::Vulkan { allocation, .. } => {
                let guard = allocation.lock();
                let mapped = guard
                    .as_ref()
                    .and_then(|allocation| allocation.mapped_ptr())
                    .ok_or_else(|| {
                        GraphicsError::Internal("buffer memory is not mapped".to_string())
                    })?;
                unsafe {
                    let dst = (mapped.as_ptr() as *mut u8).add(offset as usize);
                    std::ptr::copy_nonoverlapping(data.as_ptr(), dst, data.len());
                }
                Ok(())
            }
        }
    }

    /// Read `size` bytes at `offset` back to the host.
    ///
    /// The caller must have waited for the GPU work that writes the range.
    pub fn read(&self, offset: u64, size: u64) -> GraphicsResult<Vec<u8>> {
        self.check_host_range(offset, size)?;
        match &self.gpu {
            GpuBuffer::Test { memory } => {
                let start = offset as usize;
                Ok(memory.lock()[start..start + size as usize].to_vec())
            }
            GpuBuffer::Gl { context, name } => gl::read_buffer(context, *name, offset, size),
            #[cfg(feature = "vulkan-backend")]
            GpuBuffer::Vulkan { allocation, .. } => {
                let guard = allocation.lock();
                let mapped = guard
                    .as_ref()
                    .and_then(|allocation| allocation.mapped_ptr())
                    .ok_or_else(|| {
                        GraphicsError::Internal("buffer memory is not mapped".to_string())
                    })?;
                let mut result = vec![0u8; size as usize];
                unsafe {
                    let src = (mapped.as_ptr() as *const u8).add(offset as usize);
                    std::ptr::copy_nonoverlapping(src, result.as_mut_ptr(), result.len());
                }
                Ok(result)
            }
        }
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("size", &self.descriptor.size)
            .field("usage", &self.descriptor.usage)
            .field("label", &self.descriptor.label)
            .finish()
    }
}

// Ensure Buffer is Send + Sync
static_assertions::assert_impl_all!(Buffer: Send, Sync);

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;
    use crate::types::MemoryPropertyFlags;

    fn test_buffer(descriptor: BufferDescriptor) -> Buffer {
        let memory = Mutex::new(vec![0; descriptor.size as usize]);
        Buffer::new(DeviceId::for_tests(), descriptor, GpuBuffer::Test { memory })
    }

    #[test]
    fn test_buffer_debug() {
        let buffer = test_buffer(BufferDescriptor::new(1024, BufferUsageFlags::VERTEX));
        let debug = format!("{:?}", buffer);
        assert!(debug.contains("Buffer"));
        assert!(debug.contains("1024"));
    }

    #[test]
    fn test_host_write_and_read() {
        let buffer = test_buffer(
            BufferDescriptor::new(16, BufferUsageFlags::UNIFORM)
                .with_memory_flags(MemoryPropertyFlags::HOST_VISIBLE),
        );
        buffer.write(4, &[1, 2, 3, 4]).unwrap();
        assert_eq!(buffer.read(2, 6).unwrap(), vec![0, 0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_host_access_requires_visibility() {
        let buffer = test_buffer(BufferDescriptor::new(16, BufferUsageFlags::UNIFORM));
        assert!(matches!(
            buffer.write(0, &[1]),
            Err(GraphicsError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_host_access_out_of_range() {
        let buffer = test_buffer(
            BufferDescriptor::new(8, BufferUsageFlags::UNIFORM)
                .with_memory_flags(MemoryPropertyFlags::HOST_VISIBLE),
        );
        assert!(buffer.read(4, 8).is_err());
        assert!(buffer.write(u64::MAX, &[1]).is_err());
    }
}
