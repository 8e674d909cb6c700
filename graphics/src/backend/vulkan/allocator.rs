//! Device memory through gpu-allocator.

use ash::vk;
use gpu_allocator::vulkan::{
    Allocation, AllocationCreateDesc, AllocationScheme, Allocator, AllocatorCreateDesc,
};
use gpu_allocator::{AllocationError, MemoryLocation};

use crate::error::{GraphicsError, GraphicsResult};
use crate::types::MemoryPropertyFlags;

pub fn create_allocator(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    device: ash::Device,
) -> GraphicsResult<Allocator> {
    Allocator::new(&AllocatorCreateDesc {
        instance: instance.clone(),
        device,
        physical_device,
        debug_settings: Default::default(),
        buffer_device_address: false,
        allocation_sizes: gpu_allocator::AllocationSizes::default(),
    })
    .map_err(|e| GraphicsError::InitializationFailed(format!("memory allocator: {e}")))
}

/// Where memory with the requested properties lives.
pub fn memory_location(flags: MemoryPropertyFlags) -> MemoryLocation {
    if flags.contains(MemoryPropertyFlags::HOST_CACHED) {
        MemoryLocation::GpuToCpu
    } else if flags.contains(MemoryPropertyFlags::HOST_VISIBLE) {
        MemoryLocation::CpuToGpu
    } else {
        MemoryLocation::GpuOnly
    }
}

pub fn allocate(
    allocator: &mut Allocator,
    name: &str,
    requirements: vk::MemoryRequirements,
    location: MemoryLocation,
    linear: bool,
) -> GraphicsResult<Allocation> {
    allocator
        .allocate(&AllocationCreateDesc {
            name,
            requirements,
            location,
            linear,
            allocation_scheme: AllocationScheme::GpuAllocatorManaged,
        })
        .map_err(|e| match e {
            AllocationError::OutOfMemory => GraphicsError::OutOfMemory,
            e => GraphicsError::ResourceCreationFailed(format!("allocating {name}: {e}")),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_location() {
        assert_eq!(
            memory_location(MemoryPropertyFlags::DEVICE_LOCAL),
            MemoryLocation::GpuOnly
        );
        assert_eq!(
            memory_location(MemoryPropertyFlags::HOST_VISIBLE | MemoryPropertyFlags::HOST_COHERENT),
            MemoryLocation::CpuToGpu
        );
        assert_eq!(
            memory_location(MemoryPropertyFlags::HOST_VISIBLE | MemoryPropertyFlags::HOST_CACHED),
            MemoryLocation::GpuToCpu
        );
    }
}
