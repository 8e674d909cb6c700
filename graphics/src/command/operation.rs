//! Recorded operations.
//!
//! Every [`Operation`] owns its arguments. Resources are held through `Arc`
//! so a recorded list keeps everything it references alive, and a list can
//! be replayed any number of times.

use std::sync::Arc;

use crate::resources::{
    Buffer, DescriptorSet, Framebuffer, Image, Pipeline, PipelineLayout, QueryPool, RenderPass,
};
use crate::types::{
    AccessFlags, BufferCopy, BufferImageCopy, ClearAttachment, ClearColourValue,
    ClearDepthStencilValue, ClearRect, ClearValue, DependencyFlags, ImageCopy, ImageLayout,
    ImageSubresourceRange, IndexType, PipelineBindPoint, PipelineStageFlags, PushConstantsDesc,
    QueryControlFlags, Rect2d, StencilFaceFlags, SubpassContents, Viewport,
};

/// Global memory dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MemoryBarrier {
    pub src_access: AccessFlags,
    pub dst_access: AccessFlags,
}

/// Memory dependency on a buffer range.
#[derive(Debug, Clone)]
pub struct BufferMemoryBarrier {
    pub src_access: AccessFlags,
    pub dst_access: AccessFlags,
    pub buffer: Arc<Buffer>,
    pub offset: u64,
    pub size: u64,
}

impl BufferMemoryBarrier {
    /// Barrier over the whole buffer.
    pub fn whole(buffer: &Arc<Buffer>, src_access: AccessFlags, dst_access: AccessFlags) -> Self {
        Self {
            src_access,
            dst_access,
            buffer: buffer.clone(),
            offset: 0,
            size: buffer.size(),
        }
    }
}

/// Memory dependency and layout transition of an image range.
#[derive(Debug, Clone)]
pub struct ImageMemoryBarrier {
    pub src_access: AccessFlags,
    pub dst_access: AccessFlags,
    pub old_layout: ImageLayout,
    pub new_layout: ImageLayout,
    pub image: Arc<Image>,
    pub range: ImageSubresourceRange,
}

impl ImageMemoryBarrier {
    /// Transition of every subresource of `image`.
    pub fn transition(image: &Arc<Image>, old_layout: ImageLayout, new_layout: ImageLayout) -> Self {
        Self {
            src_access: AccessFlags::empty(),
            dst_access: AccessFlags::empty(),
            old_layout,
            new_layout,
            image: image.clone(),
            range: image.full_range(),
        }
    }

    /// Set the access masks.
    pub fn with_access(mut self, src_access: AccessFlags, dst_access: AccessFlags) -> Self {
        self.src_access = src_access;
        self.dst_access = dst_access;
        self
    }
}

/// One recorded command.
#[derive(Debug, Clone)]
pub enum Operation {
    BeginRenderPass {
        render_pass: Arc<RenderPass>,
        framebuffer: Arc<Framebuffer>,
        render_area: Rect2d,
        clear_values: Vec<ClearValue>,
        contents: SubpassContents,
    },
    NextSubpass {
        contents: SubpassContents,
    },
    EndRenderPass,
    BindPipeline {
        pipeline: Arc<Pipeline>,
    },
    BindVertexBuffers {
        first_binding: u32,
        buffers: Vec<(Arc<Buffer>, u64)>,
    },
    BindIndexBuffer {
        buffer: Arc<Buffer>,
        offset: u64,
        index_type: IndexType,
    },
    BindDescriptorSets {
        bind_point: PipelineBindPoint,
        layout: Arc<PipelineLayout>,
        first_set: u32,
        sets: Vec<Arc<DescriptorSet>>,
        dynamic_offsets: Vec<u32>,
    },
    SetViewport(Viewport),
    SetScissor(Rect2d),
    SetLineWidth(f32),
    SetDepthBias {
        constant_factor: f32,
        clamp: f32,
        slope_factor: f32,
    },
    SetBlendConstants([f32; 4]),
    SetStencilReference {
        faces: StencilFaceFlags,
        reference: u32,
    },
    SetStencilCompareMask {
        faces: StencilFaceFlags,
        mask: u32,
    },
    SetStencilWriteMask {
        faces: StencilFaceFlags,
        mask: u32,
    },
    Draw {
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    },
    DrawIndexed {
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    },
    DrawIndirect {
        buffer: Arc<Buffer>,
        offset: u64,
        draw_count: u32,
        stride: u32,
    },
    DrawIndexedIndirect {
        buffer: Arc<Buffer>,
        offset: u64,
        draw_count: u32,
        stride: u32,
    },
    Dispatch {
        x: u32,
        y: u32,
        z: u32,
    },
    DispatchIndirect {
        buffer: Arc<Buffer>,
        offset: u64,
    },
    ClearColourImage {
        image: Arc<Image>,
        layout: ImageLayout,
        colour: ClearColourValue,
        ranges: Vec<ImageSubresourceRange>,
    },
    ClearDepthStencilImage {
        image: Arc<Image>,
        layout: ImageLayout,
        value: ClearDepthStencilValue,
        ranges: Vec<ImageSubresourceRange>,
    },
    /// Clears regions of attachments of the current subpass.
    ClearAttachments {
        attachments: Vec<ClearAttachment>,
        rects: Vec<ClearRect>,
    },
    CopyBuffer {
        src: Arc<Buffer>,
        dst: Arc<Buffer>,
        regions: Vec<BufferCopy>,
    },
    CopyImage {
        src: Arc<Image>,
        src_layout: ImageLayout,
        dst: Arc<Image>,
        dst_layout: ImageLayout,
        regions: Vec<ImageCopy>,
    },
    CopyBufferToImage {
        src: Arc<Buffer>,
        dst: Arc<Image>,
        dst_layout: ImageLayout,
        regions: Vec<BufferImageCopy>,
    },
    PipelineBarrier {
        src_stage: PipelineStageFlags,
        dst_stage: PipelineStageFlags,
        dependency_flags: DependencyFlags,
        memory: Vec<MemoryBarrier>,
        buffers: Vec<BufferMemoryBarrier>,
        images: Vec<ImageMemoryBarrier>,
    },
    ResetQueryPool {
        pool: Arc<QueryPool>,
        first: u32,
        count: u32,
    },
    BeginQuery {
        pool: Arc<QueryPool>,
        query: u32,
        flags: QueryControlFlags,
    },
    EndQuery {
        pool: Arc<QueryPool>,
        query: u32,
    },
    WriteTimestamp {
        stage: PipelineStageFlags,
        pool: Arc<QueryPool>,
        query: u32,
    },
    PushConstants {
        layout: Arc<PipelineLayout>,
        constants: PushConstantsDesc,
    },
    /// Snapshots of executable secondary command lists.
    ExecuteCommands {
        lists: Vec<Arc<CommandList>>,
    },
}

impl Operation {
    /// Name of the operation, for logs and bookkeeping.
    pub fn name(&self) -> &'static str {
        match self {
            Self::BeginRenderPass { .. } => "BeginRenderPass",
            Self::NextSubpass { .. } => "NextSubpass",
            Self::EndRenderPass => "EndRenderPass",
            Self::BindPipeline { .. } => "BindPipeline",
            Self::BindVertexBuffers { .. } => "BindVertexBuffers",
            Self::BindIndexBuffer { .. } => "BindIndexBuffer",
            Self::BindDescriptorSets { .. } => "BindDescriptorSets",
            Self::SetViewport(_) => "SetViewport",
            Self::SetScissor(_) => "SetScissor",
            Self::SetLineWidth(_) => "SetLineWidth",
            Self::SetDepthBias { .. } => "SetDepthBias",
            Self::SetBlendConstants(_) => "SetBlendConstants",
            Self::SetStencilReference { .. } => "SetStencilReference",
            Self::SetStencilCompareMask { .. } => "SetStencilCompareMask",
            Self::SetStencilWriteMask { .. } => "SetStencilWriteMask",
            Self::Draw { .. } => "Draw",
            Self::DrawIndexed { .. } => "DrawIndexed",
            Self::DrawIndirect { .. } => "DrawIndirect",
            Self::DrawIndexedIndirect { .. } => "DrawIndexedIndirect",
            Self::Dispatch { .. } => "Dispatch",
            Self::DispatchIndirect { .. } => "DispatchIndirect",
            Self::ClearColourImage { .. } => "ClearColourImage",
            Self::ClearDepthStencilImage { .. } => "ClearDepthStencilImage",
            Self::ClearAttachments { .. } => "ClearAttachments",
            Self::CopyBuffer { .. } => "CopyBuffer",
            Self::CopyImage { .. } => "CopyImage",
            Self::CopyBufferToImage { .. } => "CopyBufferToImage",
            Self::PipelineBarrier { .. } => "PipelineBarrier",
            Self::ResetQueryPool { .. } => "ResetQueryPool",
            Self::BeginQuery { .. } => "BeginQuery",
            Self::EndQuery { .. } => "EndQuery",
            Self::WriteTimestamp { .. } => "WriteTimestamp",
            Self::PushConstants { .. } => "PushConstants",
            Self::ExecuteCommands { .. } => "ExecuteCommands",
        }
    }
}

/// An ordered list of operations, replayed in record order.
#[derive(Debug, Clone, Default)]
pub struct CommandList {
    operations: Vec<Operation>,
}

impl CommandList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an operation.
    pub fn push(&mut self, operation: Operation) {
        self.operations.push(operation);
    }

    /// Number of operations, not counting nested secondary lists.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Iterate in record order.
    pub fn iter(&self) -> std::slice::Iter<'_, Operation> {
        self.operations.iter()
    }

    /// Number of operations including those of executed secondary lists.
    pub fn total_len(&self) -> usize {
        self.operations
            .iter()
            .map(|op| match op {
                Operation::ExecuteCommands { lists } => {
                    1 + lists.iter().map(|l| l.total_len()).sum::<usize>()
                }
                _ => 1,
            })
            .sum()
    }
}

impl<'a> IntoIterator for &'a CommandList {
    type Item = &'a Operation;
    type IntoIter = std::slice::Iter<'a, Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.operations.iter()
    }
}

static_assertions::assert_impl_all!(CommandList: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_preserves_order() {
        let mut list = CommandList::new();
        list.push(Operation::SetLineWidth(2.0));
        list.push(Operation::Dispatch { x: 1, y: 1, z: 1 });
        list.push(Operation::EndRenderPass);
        let names: Vec<_> = list.iter().map(Operation::name).collect();
        assert_eq!(names, vec!["SetLineWidth", "Dispatch", "EndRenderPass"]);
    }

    #[test]
    fn test_total_len_counts_secondaries() {
        let mut secondary = CommandList::new();
        secondary.push(Operation::SetLineWidth(1.0));
        secondary.push(Operation::SetBlendConstants([0.0; 4]));
        let mut primary = CommandList::new();
        primary.push(Operation::ExecuteCommands {
            lists: vec![Arc::new(secondary)],
        });
        assert_eq!(primary.len(), 1);
        assert_eq!(primary.total_len(), 3);
    }
}
