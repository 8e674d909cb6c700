//! Vulkan-style bitmasks.
//!
//! Bit values match their Vulkan counterparts so the Vulkan backend can
//! forward them with `from_raw`.

use bitflags::bitflags;

bitflags! {
    /// Usage flags for buffers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BufferUsageFlags: u32 {
        /// Source of transfer commands.
        const TRANSFER_SRC = 1 << 0;
        /// Destination of transfer commands.
        const TRANSFER_DST = 1 << 1;
        /// Uniform texel buffer.
        const UNIFORM_TEXEL = 1 << 2;
        /// Storage texel buffer.
        const STORAGE_TEXEL = 1 << 3;
        /// Uniform buffer.
        const UNIFORM = 1 << 4;
        /// Storage buffer.
        const STORAGE = 1 << 5;
        /// Index buffer.
        const INDEX = 1 << 6;
        /// Vertex buffer.
        const VERTEX = 1 << 7;
        /// Indirect argument buffer.
        const INDIRECT = 1 << 8;
    }
}

bitflags! {
    /// Usage flags for images.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ImageUsageFlags: u32 {
        /// Source of transfer commands.
        const TRANSFER_SRC = 1 << 0;
        /// Destination of transfer commands.
        const TRANSFER_DST = 1 << 1;
        /// Sampled from shaders.
        const SAMPLED = 1 << 2;
        /// Storage image.
        const STORAGE = 1 << 3;
        /// Colour attachment.
        const COLOR_ATTACHMENT = 1 << 4;
        /// Depth/stencil attachment.
        const DEPTH_STENCIL_ATTACHMENT = 1 << 5;
        /// Transient attachment.
        const TRANSIENT_ATTACHMENT = 1 << 6;
        /// Input attachment.
        const INPUT_ATTACHMENT = 1 << 7;
    }
}

bitflags! {
    /// Memory property flags requested for a resource allocation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MemoryPropertyFlags: u32 {
        /// Device local memory.
        const DEVICE_LOCAL = 1 << 0;
        /// Memory mappable by the host.
        const HOST_VISIBLE = 1 << 1;
        /// Host writes are visible without flushes.
        const HOST_COHERENT = 1 << 2;
        /// Memory cached on the host.
        const HOST_CACHED = 1 << 3;
        /// Memory allocated lazily by the implementation.
        const LAZILY_ALLOCATED = 1 << 4;
    }
}

bitflags! {
    /// Pipeline stages, used by barriers, semaphore waits and timestamps.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PipelineStageFlags: u32 {
        const TOP_OF_PIPE = 1 << 0;
        const DRAW_INDIRECT = 1 << 1;
        const VERTEX_INPUT = 1 << 2;
        const VERTEX_SHADER = 1 << 3;
        const TESSELLATION_CONTROL_SHADER = 1 << 4;
        const TESSELLATION_EVALUATION_SHADER = 1 << 5;
        const GEOMETRY_SHADER = 1 << 6;
        const FRAGMENT_SHADER = 1 << 7;
        const EARLY_FRAGMENT_TESTS = 1 << 8;
        const LATE_FRAGMENT_TESTS = 1 << 9;
        const COLOR_ATTACHMENT_OUTPUT = 1 << 10;
        const COMPUTE_SHADER = 1 << 11;
        const TRANSFER = 1 << 12;
        const BOTTOM_OF_PIPE = 1 << 13;
        const HOST = 1 << 14;
        const ALL_GRAPHICS = 1 << 15;
        const ALL_COMMANDS = 1 << 16;
    }
}

bitflags! {
    /// Memory access types, used by barriers and subpass dependencies.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AccessFlags: u32 {
        const INDIRECT_COMMAND_READ = 1 << 0;
        const INDEX_READ = 1 << 1;
        const VERTEX_ATTRIBUTE_READ = 1 << 2;
        const UNIFORM_READ = 1 << 3;
        const INPUT_ATTACHMENT_READ = 1 << 4;
        const SHADER_READ = 1 << 5;
        const SHADER_WRITE = 1 << 6;
        const COLOR_ATTACHMENT_READ = 1 << 7;
        const COLOR_ATTACHMENT_WRITE = 1 << 8;
        const DEPTH_STENCIL_ATTACHMENT_READ = 1 << 9;
        const DEPTH_STENCIL_ATTACHMENT_WRITE = 1 << 10;
        const TRANSFER_READ = 1 << 11;
        const TRANSFER_WRITE = 1 << 12;
        const HOST_READ = 1 << 13;
        const HOST_WRITE = 1 << 14;
        const MEMORY_READ = 1 << 15;
        const MEMORY_WRITE = 1 << 16;
    }
}

bitflags! {
    /// Dependency flags of barriers and subpass dependencies.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DependencyFlags: u32 {
        /// Dependencies are framebuffer-local.
        const BY_REGION = 1 << 0;
    }
}

bitflags! {
    /// Shader stages.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ShaderStageFlags: u32 {
        const VERTEX = 1 << 0;
        const TESSELLATION_CONTROL = 1 << 1;
        const TESSELLATION_EVALUATION = 1 << 2;
        const GEOMETRY = 1 << 3;
        const FRAGMENT = 1 << 4;
        const COMPUTE = 1 << 5;
        const ALL_GRAPHICS = 0x1f;
    }
}

bitflags! {
    /// Aspects of an image (colour, depth, stencil).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ImageAspectFlags: u32 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
    }
}

bitflags! {
    /// Colour channels written by a blend attachment.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ColourComponentFlags: u32 {
        const R = 1 << 0;
        const G = 1 << 1;
        const B = 1 << 2;
        const A = 1 << 3;
    }
}

impl Default for ColourComponentFlags {
    fn default() -> Self {
        Self::all()
    }
}

bitflags! {
    /// Faces culled by the rasteriser.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CullModeFlags: u32 {
        const FRONT = 1 << 0;
        const BACK = 1 << 1;
        const FRONT_AND_BACK = Self::FRONT.bits() | Self::BACK.bits();
    }
}

bitflags! {
    /// Faces targeted by a dynamic stencil state command.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StencilFaceFlags: u32 {
        const FRONT = 1 << 0;
        const BACK = 1 << 1;
        const FRONT_AND_BACK = Self::FRONT.bits() | Self::BACK.bits();
    }
}

bitflags! {
    /// Usage hints passed to `CommandBuffer::begin`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CommandBufferUsageFlags: u32 {
        const ONE_TIME_SUBMIT = 1 << 0;
        const RENDER_PASS_CONTINUE = 1 << 1;
        const SIMULTANEOUS_USE = 1 << 2;
    }
}

bitflags! {
    /// Flags of `BeginQuery`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct QueryControlFlags: u32 {
        const PRECISE = 1 << 0;
    }
}

bitflags! {
    /// Flags controlling how query results are returned.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct QueryResultFlags: u32 {
        const TYPE_64 = 1 << 0;
        const WAIT = 1 << 1;
        const WITH_AVAILABILITY = 1 << 2;
        const PARTIAL = 1 << 3;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_colour_components_default_to_all() {
        assert_eq!(ColourComponentFlags::default(), ColourComponentFlags::all());
    }

    #[test]
    fn test_front_and_back() {
        assert!(CullModeFlags::FRONT_AND_BACK.contains(CullModeFlags::FRONT));
        assert!(CullModeFlags::FRONT_AND_BACK.contains(CullModeFlags::BACK));
        assert!(CullModeFlags::default().is_empty());
    }
}
