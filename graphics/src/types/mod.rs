//! Common types and descriptors for graphics resources.
//!
//! This module contains format enums, Vulkan-style flags, fixed-function
//! state and the descriptor structs used throughout the graphics system.

mod buffer;
mod common;
mod flags;
mod format;
mod image;
mod pipeline;
mod render_pass;
mod sampler;

pub use buffer::{
    BufferCopy, BufferDescriptor, DispatchIndirectArgs, DrawIndexedIndirectArgs,
    DrawIndirectArgs,
};
pub(crate) use common::stencil_faces;
pub use common::{
    BlendFactor, BlendOp, ClearAttachment, ClearColourValue, ClearDepthStencilValue, ClearRect,
    ClearValue, CompareOp, Extent2d, Extent3d, FrontFace, IndexType, LogicOp, Offset2d, Offset3d,
    PipelineBindPoint, PolygonMode, PrimitiveTopology, QueryPoolDescriptor, QueryType, Rect2d,
    StencilOp, Viewport, WaitResult,
};
pub use flags::{
    AccessFlags, BufferUsageFlags, ColourComponentFlags, CommandBufferUsageFlags, CullModeFlags,
    DependencyFlags, ImageAspectFlags, ImageUsageFlags, MemoryPropertyFlags, PipelineStageFlags,
    QueryControlFlags, QueryResultFlags, ShaderStageFlags, StencilFaceFlags,
};
pub use format::Format;
pub use image::{
    BufferImageCopy, ComponentMapping, ComponentSwizzle, ImageCopy, ImageDescriptor, ImageLayout,
    ImageSubresourceLayers, ImageSubresourceRange, ImageType, ImageViewDescriptor, ImageViewType,
    SampleCount,
};
pub use pipeline::{
    ColourBlendAttachmentState, ColourBlendState, ConstantFormat, DepthStencilState,
    DescriptorSetLayoutBinding, DescriptorType, DynamicStateFlags, InputAssemblyState,
    MultisampleState, PushConstant, PushConstantRange, PushConstantsDesc, RasterisationState,
    ShaderSource, ShaderStage, StencilOpState, TessellationState, VertexInputAttribute,
    VertexInputBinding, VertexInputRate, VertexInputState,
};
pub use render_pass::{
    AttachmentDescription, AttachmentLoadOp, AttachmentReference, AttachmentStoreOp,
    RenderPassDescriptor, SubpassContents, SubpassDependency, SubpassDescription,
    ATTACHMENT_UNUSED, SUBPASS_EXTERNAL,
};
pub use sampler::{AddressMode, BorderColour, Filter, MipmapMode, SamplerDescriptor};
