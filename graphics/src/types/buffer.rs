//! Buffer types and descriptors.

use super::{BufferUsageFlags, MemoryPropertyFlags};

/// Descriptor for creating a buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BufferDescriptor {
    /// Debug label for the buffer.
    pub label: Option<String>,
    /// Size in bytes.
    pub size: u64,
    /// Usage flags.
    pub usage: BufferUsageFlags,
    /// Requested memory properties.
    pub memory_flags: MemoryPropertyFlags,
}

impl BufferDescriptor {
    /// Create a new device-local buffer descriptor.
    pub fn new(size: u64, usage: BufferUsageFlags) -> Self {
        Self {
            label: None,
            size,
            usage,
            memory_flags: MemoryPropertyFlags::DEVICE_LOCAL,
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the requested memory properties.
    pub fn with_memory_flags(mut self, flags: MemoryPropertyFlags) -> Self {
        self.memory_flags = flags;
        self
    }

    /// Whether the buffer is mappable from the host.
    pub fn is_host_visible(&self) -> bool {
        self.memory_flags.contains(MemoryPropertyFlags::HOST_VISIBLE)
    }
}

/// One region of a buffer-to-buffer copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BufferCopy {
    pub src_offset: u64,
    pub dst_offset: u64,
    pub size: u64,
}

impl BufferCopy {
    /// Create a copy region.
    pub fn new(src_offset: u64, dst_offset: u64, size: u64) -> Self {
        Self {
            src_offset,
            dst_offset,
            size,
        }
    }
}

// ============================================================================
// Indirect arguments
// ============================================================================

/// Arguments of one non-indexed indirect draw, laid out as the GPU reads them.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawIndirectArgs {
    pub vertex_count: u32,
    pub instance_count: u32,
    pub first_vertex: u32,
    pub first_instance: u32,
}

impl DrawIndirectArgs {
    /// Size of the struct in bytes.
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;

    /// Create new indirect draw arguments.
    pub fn new(vertex_count: u32, instance_count: u32) -> Self {
        Self {
            vertex_count,
            instance_count,
            first_vertex: 0,
            first_instance: 0,
        }
    }

    /// Bytes to upload into an indirect buffer.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

/// Arguments of one indexed indirect draw, laid out as the GPU reads them.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawIndexedIndirectArgs {
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub base_vertex: i32,
    pub first_instance: u32,
}

impl DrawIndexedIndirectArgs {
    /// Size of the struct in bytes.
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;

    /// Create new indexed indirect draw arguments.
    pub fn new(index_count: u32, instance_count: u32) -> Self {
        Self {
            index_count,
            instance_count,
            first_index: 0,
            base_vertex: 0,
            first_instance: 0,
        }
    }

    /// Set the base vertex offset.
    pub fn with_base_vertex(mut self, base_vertex: i32) -> Self {
        self.base_vertex = base_vertex;
        self
    }

    /// Bytes to upload into an indirect buffer.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

/// Arguments of an indirect compute dispatch.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DispatchIndirectArgs {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indirect_args_layout() {
        assert_eq!(DrawIndirectArgs::SIZE, 16);
        assert_eq!(DrawIndexedIndirectArgs::SIZE, 20);
        assert_eq!(std::mem::size_of::<DispatchIndirectArgs>(), 12);
    }

    #[test]
    fn test_indexed_args_bytes() {
        let args = DrawIndexedIndirectArgs::new(36, 2).with_base_vertex(-1);
        let bytes = args.as_bytes();
        assert_eq!(bytes.len(), 20);
        assert_eq!(&bytes[0..4], &36u32.to_ne_bytes());
        assert_eq!(&bytes[12..16], &(-1i32).to_ne_bytes());
    }

    #[test]
    fn test_buffer_descriptor_builder() {
        let desc = BufferDescriptor::new(256, BufferUsageFlags::UNIFORM)
            .with_label("ubo")
            .with_memory_flags(MemoryPropertyFlags::HOST_VISIBLE | MemoryPropertyFlags::HOST_COHERENT);
        assert_eq!(desc.label.as_deref(), Some("ubo"));
        assert!(desc.is_host_visible());
    }
}
