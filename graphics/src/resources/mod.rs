//! GPU resources.
//!
//! This module contains the resource types created by [`GraphicsDevice`]:
//! - [`Buffer`], [`Image`], [`ImageView`], [`Sampler`] - memory objects
//! - [`QueryPool`] - occlusion, statistics and timestamp queries
//! - [`RenderPass`], [`Framebuffer`] - attachment descriptions and targets
//! - [`DescriptorSetLayout`], [`PipelineLayout`], [`DescriptorSet`], [`Pipeline`]
//! - [`Semaphore`], [`Fence`] - synchronisation
//! - [`SwapChain`] - presentable images
//!
//! Resources are reference-counted with [`Arc`] and can be shared across
//! threads. Each resource is tagged with the [`DeviceId`] of its device and
//! releases its native object when the last handle drops.
//!
//! [`GraphicsDevice`]: crate::GraphicsDevice
//! [`DeviceId`]: crate::DeviceId
//! [`Arc`]: std::sync::Arc

mod buffer;
mod image;
mod pipeline;
mod query_pool;
mod render_pass;
mod sampler;
mod swapchain;
mod sync;

pub use buffer::Buffer;
pub use image::{Image, ImageView};
pub use pipeline::{
    DescriptorResource, DescriptorSet, DescriptorSetLayout, DescriptorWrite, GraphicsState,
    Pipeline, PipelineBuilder, PipelineDescriptor, PipelineLayout,
};
pub use query_pool::QueryPool;
pub use render_pass::{Framebuffer, RenderPass};
pub use sampler::Sampler;
pub use swapchain::{SwapChain, SwapChainDescriptor};
pub use sync::{Fence, Semaphore};
