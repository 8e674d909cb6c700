//! Command recording and submission.
//!
//! A [`CommandBuffer`] records [`Operation`]s into a [`CommandList`]. A
//! [`Queue`] hands the lists to the device backend, which either replays
//! them against an OpenGL context or, on Vulkan, submits the native command
//! buffers they were forwarded into.

mod buffer;
mod operation;
mod queue;

pub use buffer::{CommandBuffer, CommandBufferLevel, CommandBufferState};
pub use operation::{
    BufferMemoryBarrier, CommandList, ImageMemoryBarrier, MemoryBarrier, Operation,
};
pub(crate) use queue::{SubmitBatch, Submitted};
pub use queue::{PresentInfo, Queue, SubmitInfo};
