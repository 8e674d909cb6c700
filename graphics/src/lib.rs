//! # Ashes Graphics
//!
//! A Vulkan-shaped graphics API over four backends.
//!
//! ## Overview
//!
//! Clients record work into [`CommandBuffer`]s with Vulkan semantics (render
//! passes, pipeline barriers, descriptor sets, push constants) and submit
//! them to a [`Queue`]. What happens next depends on the device backend:
//!
//! - **Vulkan** (feature `vulkan-backend`): the recorded operations are
//!   forwarded into native command buffers through `ash`
//! - **Gl3 / Gl4**: the operations are replayed, in order, against a single
//!   OpenGL context through the [`GlApi`] entry points
//! - **Test**: nothing native happens; executed operations are counted
//!
//! ## Example
//!
//! ```ignore
//! use ashes_graphics::*;
//!
//! let instance = GraphicsInstance::new(InstanceParameters::new().with_backend(BackendType::Test))?;
//! let device = instance.create_device(Connection::headless())?;
//!
//! let mut cmd = device.create_command_buffer(CommandBufferLevel::Primary)?;
//! cmd.begin(CommandBufferUsageFlags::ONE_TIME_SUBMIT)?;
//! cmd.end()?;
//! device.graphics_queue().submit(&[SubmitInfo::new(&[&cmd])], None)?;
//! ```

pub mod backend;
pub mod command;
pub mod connection;
pub mod device;
pub mod error;
pub mod instance;
pub mod resources;
#[cfg(feature = "vulkan-backend")]
pub mod surface;
pub mod types;

pub use backend::gl::{
    ContextId, ContextLock, ContextRegistry, GlApi, GlCall, GlContext, GlProfile, GlVersion,
    HeadlessPlatform, PlatformContext, RecordingGl,
};
#[cfg(feature = "gl-native")]
pub use backend::gl::GlowApi;
pub use backend::{BackendCapabilities, BackendType};
pub use command::{
    BufferMemoryBarrier, CommandBuffer, CommandBufferLevel, CommandBufferState, CommandList,
    ImageMemoryBarrier, MemoryBarrier, Operation, PresentInfo, Queue, SubmitInfo,
};
pub use connection::{Connection, Platform};
pub use device::{DeviceId, GraphicsDevice};
pub use error::{GraphicsError, GraphicsResult};
pub use instance::{GraphicsInstance, InstanceParameters};
pub use resources::{
    Buffer, DescriptorResource, DescriptorSet, DescriptorSetLayout, DescriptorWrite, Fence,
    Framebuffer, GraphicsState, Image, ImageView, Pipeline, PipelineBuilder,
    PipelineDescriptor, PipelineLayout, QueryPool, RenderPass, Sampler, Semaphore, SwapChain,
    SwapChainDescriptor,
};
#[cfg(feature = "vulkan-backend")]
pub use surface::Surface;
pub use types::*;

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_headless_round_trip() {
        let instance =
            GraphicsInstance::new(InstanceParameters::new().with_backend(BackendType::Test))
                .unwrap();
        let device = instance.create_device(Connection::headless()).unwrap();
        let mut cmd = device
            .create_command_buffer(CommandBufferLevel::Primary)
            .unwrap();
        cmd.begin(CommandBufferUsageFlags::ONE_TIME_SUBMIT).unwrap();
        cmd.end().unwrap();
        device
            .graphics_queue()
            .submit(&[SubmitInfo::new(&[&cmd])], None)
            .unwrap();
        assert_eq!(device.executed_operation_count(), 0);
    }
}
