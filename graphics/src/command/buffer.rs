//! Command buffers.

use std::sync::Arc;

use parking_lot::Mutex;

use super::operation::{
    BufferMemoryBarrier, CommandList, ImageMemoryBarrier, MemoryBarrier, Operation,
};
use crate::backend::GpuCommandBuffer;
use crate::device::{DeviceId, GraphicsDevice};
use crate::error::{GraphicsError, GraphicsResult};
use crate::resources::{
    Buffer, DescriptorSet, Framebuffer, Image, Pipeline, PipelineLayout, QueryPool, RenderPass,
};
use crate::types::{
    BufferCopy, BufferImageCopy, ClearAttachment, ClearColourValue, ClearDepthStencilValue,
    ClearRect, ClearValue, CommandBufferUsageFlags, DependencyFlags, ImageCopy, ImageLayout,
    ImageSubresourceRange, IndexType, PipelineBindPoint, PipelineStageFlags, PushConstantsDesc,
    QueryControlFlags, Rect2d, StencilFaceFlags, SubpassContents, Viewport,
};

/// Whether a command buffer is submitted directly or executed by another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CommandBufferLevel {
    #[default]
    Primary,
    /// Only executable from a primary through `execute_commands`.
    Secondary,
}

/// Lifecycle state of a command buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandBufferState {
    Initial,
    Recording,
    Executable,
    /// Part of a submission that has not finished executing.
    Pending,
    /// Needs `reset` or `begin` before it can be used again.
    Invalid,
}

struct CommandBufferInner {
    state: CommandBufferState,
    usage: CommandBufferUsageFlags,
    list: Arc<CommandList>,
    in_render_pass: bool,
    pending: u32,
    /// Newest submission still running on the GPU, 0 for none.
    in_flight: u64,
}

impl CommandBufferInner {
    /// Leaves `Pending` once nothing is executing the buffer any more.
    fn settle(&mut self, lost: bool) {
        self.state = if lost || self.usage.contains(CommandBufferUsageFlags::ONE_TIME_SUBMIT) {
            CommandBufferState::Invalid
        } else {
            CommandBufferState::Executable
        };
    }

    /// Settles the buffer if its last submission has finished on the GPU.
    fn retire_finished(&mut self, device: &GraphicsDevice) {
        if self.in_flight == 0 {
            return;
        }
        if !device.is_lost() && !device.submission_finished(self.in_flight) {
            return;
        }
        self.in_flight = 0;
        if self.pending == 0 && self.state == CommandBufferState::Pending {
            self.settle(device.is_lost());
        }
    }
}

/// A recorded sequence of operations.
///
/// Recording methods take `&mut self` and panic when the buffer is not in
/// the [`CommandBufferState::Recording`] state, or when given a resource of
/// another device. Lifecycle transitions return [`GraphicsError::InvalidState`]
/// instead.
///
/// # Example
///
/// ```ignore
/// let mut cmd = device.create_command_buffer(CommandBufferLevel::Primary)?;
/// cmd.begin(CommandBufferUsageFlags::ONE_TIME_SUBMIT)?;
/// cmd.copy_buffer(&staging, &vertices, &[BufferCopy::new(0, 0, size)]);
/// cmd.end()?;
/// device.graphics_queue().submit(&[SubmitInfo::new(&[&cmd])], None)?;
/// ```
pub struct CommandBuffer {
    device: Arc<GraphicsDevice>,
    level: CommandBufferLevel,
    inner: Mutex<CommandBufferInner>,
    pub(crate) gpu: GpuCommandBuffer,
}

impl CommandBuffer {
    pub(crate) fn new(
        device: Arc<GraphicsDevice>,
        level: CommandBufferLevel,
        gpu: GpuCommandBuffer,
    ) -> Self {
        Self {
            device,
            level,
            inner: Mutex::new(CommandBufferInner {
                state: CommandBufferState::Initial,
                usage: CommandBufferUsageFlags::empty(),
                list: Arc::new(CommandList::new()),
                in_render_pass: false,
                pending: 0,
                in_flight: 0,
            }),
            gpu,
        }
    }

    /// The device that created this command buffer.
    pub fn device_id(&self) -> DeviceId {
        self.device.id()
    }

    /// Primary or secondary.
    pub fn level(&self) -> CommandBufferLevel {
        self.level
    }

    /// Current lifecycle state.
    ///
    /// A buffer submitted on Vulkan reports `Pending` until the GPU has
    /// finished the submission.
    pub fn state(&self) -> CommandBufferState {
        let mut inner = self.inner.lock();
        inner.retire_finished(&self.device);
        inner.state
    }

    /// Usage flags passed to the last `begin`.
    pub fn usage(&self) -> CommandBufferUsageFlags {
        self.inner.lock().usage
    }

    /// Number of recorded operations.
    pub fn operation_count(&self) -> usize {
        self.inner.lock().list.len()
    }

    /// Snapshot of the recorded operations.
    pub fn commands(&self) -> Arc<CommandList> {
        self.inner.lock().list.clone()
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Starts recording, discarding previously recorded operations.
    pub fn begin(&mut self, usage: CommandBufferUsageFlags) -> GraphicsResult<()> {
        let inner = self.inner.get_mut();
        inner.retire_finished(&self.device);
        match inner.state {
            CommandBufferState::Initial | CommandBufferState::Executable => {}
            state => {
                return Err(GraphicsError::InvalidState(format!(
                    "cannot begin a command buffer in state {state:?}"
                )))
            }
        }
        inner.state = CommandBufferState::Recording;
        inner.usage = usage;
        inner.list = Arc::new(CommandList::new());
        inner.in_render_pass = false;
        Ok(())
    }

    /// Finishes recording.
    ///
    /// On Vulkan the recorded operations are forwarded into the native
    /// command buffer here.
    pub fn end(&mut self) -> GraphicsResult<()> {
        let inner = self.inner.get_mut();
        if inner.state != CommandBufferState::Recording {
            return Err(GraphicsError::InvalidState(format!(
                "cannot end a command buffer in state {:?}",
                inner.state
            )));
        }
        if inner.in_render_pass {
            return Err(GraphicsError::InvalidState(
                "render pass still active at end of recording".to_string(),
            ));
        }

        #[cfg(feature = "vulkan-backend")]
        if let GpuCommandBuffer::Vulkan { device, buffer, .. } = &self.gpu {
            if let Err(e) =
                crate::backend::vulkan::record_commands(device, *buffer, &inner.list, inner.usage, self.level)
            {
                inner.state = CommandBufferState::Invalid;
                return Err(e);
            }
        }

        inner.state = CommandBufferState::Executable;
        log::trace!("CommandBuffer: recorded {} operations", inner.list.len());
        Ok(())
    }

    /// Returns to the initial state, dropping the recorded operations.
    pub fn reset(&mut self) -> GraphicsResult<()> {
        let inner = self.inner.get_mut();
        inner.retire_finished(&self.device);
        if inner.state == CommandBufferState::Pending {
            return Err(GraphicsError::InvalidState(
                "cannot reset a pending command buffer".to_string(),
            ));
        }
        inner.state = CommandBufferState::Initial;
        inner.list = Arc::new(CommandList::new());
        inner.in_render_pass = false;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Submission (queue side)
    // ------------------------------------------------------------------

    pub(crate) fn check_submittable(&self, device: DeviceId) -> GraphicsResult<()> {
        assert_eq!(
            self.device_id(),
            device,
            "command buffer belongs to another device"
        );
        if self.level != CommandBufferLevel::Primary {
            return Err(GraphicsError::InvalidState(
                "secondary command buffers cannot be submitted".to_string(),
            ));
        }
        let mut inner = self.inner.lock();
        inner.retire_finished(&self.device);
        match inner.state {
            CommandBufferState::Executable => Ok(()),
            CommandBufferState::Pending
                if inner.usage.contains(CommandBufferUsageFlags::SIMULTANEOUS_USE) =>
            {
                Ok(())
            }
            state => Err(GraphicsError::InvalidState(format!(
                "cannot submit a command buffer in state {state:?}"
            ))),
        }
    }

    /// Executable -> Pending; returns the list to replay.
    pub(crate) fn begin_submit(&self) -> Arc<CommandList> {
        let mut inner = self.inner.lock();
        inner.state = CommandBufferState::Pending;
        inner.pending += 1;
        inner.list.clone()
    }

    /// Pending -> Executable, or Invalid after a one-time submission or a
    /// lost device.
    ///
    /// With `in_flight` set the GPU is still running the submission and the
    /// buffer stays pending until the device reports it finished.
    pub(crate) fn finish_submit(&self, lost: bool, in_flight: Option<u64>) {
        let mut inner = self.inner.lock();
        inner.pending = inner.pending.saturating_sub(1);
        if lost {
            inner.in_flight = 0;
        } else if let Some(serial) = in_flight {
            inner.in_flight = inner.in_flight.max(serial);
        }
        if inner.pending > 0 || inner.in_flight != 0 {
            return;
        }
        inner.settle(lost);
    }

    // ------------------------------------------------------------------
    // Recording
    // ------------------------------------------------------------------

    fn record(&mut self, operation: Operation) {
        let inner = self.inner.get_mut();
        assert_eq!(
            inner.state,
            CommandBufferState::Recording,
            "{} recorded outside of begin/end",
            operation.name()
        );
        log::trace!("CommandBuffer: record {}", operation.name());
        Arc::make_mut(&mut inner.list).push(operation);
    }

    fn check_device(&self, owner: DeviceId, what: &str) {
        assert_eq!(owner, self.device.id(), "{what} belongs to another device");
    }

    fn set_in_render_pass(&mut self, active: bool) {
        let inner = self.inner.get_mut();
        assert_ne!(
            inner.in_render_pass, active,
            "render pass {}",
            if active { "already active" } else { "not active" }
        );
        inner.in_render_pass = active;
    }

    /// True inside a render pass this buffer began, and always for a
    /// secondary that continues its primary's render pass.
    fn in_render_pass(&mut self) -> bool {
        let continues = self.level == CommandBufferLevel::Secondary;
        let inner = self.inner.get_mut();
        inner.in_render_pass
            || (continues && inner.usage.contains(CommandBufferUsageFlags::RENDER_PASS_CONTINUE))
    }

    pub fn begin_render_pass(
        &mut self,
        render_pass: &Arc<RenderPass>,
        framebuffer: &Arc<Framebuffer>,
        render_area: Rect2d,
        clear_values: &[ClearValue],
        contents: SubpassContents,
    ) {
        self.check_device(render_pass.device_id(), "render pass");
        self.check_device(framebuffer.device_id(), "framebuffer");
        assert_eq!(
            framebuffer.attachments().len(),
            render_pass.attachments().len(),
            "framebuffer does not match the render pass attachments"
        );
        self.set_in_render_pass(true);
        self.record(Operation::BeginRenderPass {
            render_pass: render_pass.clone(),
            framebuffer: framebuffer.clone(),
            render_area,
            clear_values: clear_values.to_vec(),
            contents,
        });
    }

    pub fn next_subpass(&mut self, contents: SubpassContents) {
        assert!(self.in_render_pass(), "next_subpass outside of a render pass");
        self.record(Operation::NextSubpass { contents });
    }

    pub fn end_render_pass(&mut self) {
        self.set_in_render_pass(false);
        self.record(Operation::EndRenderPass);
    }

    pub fn bind_pipeline(&mut self, pipeline: &Arc<Pipeline>) {
        self.check_device(pipeline.device_id(), "pipeline");
        self.record(Operation::BindPipeline {
            pipeline: pipeline.clone(),
        });
    }

    /// Binds `(buffer, offset)` pairs to consecutive bindings from `first_binding`.
    pub fn bind_vertex_buffers(&mut self, first_binding: u32, buffers: &[(&Arc<Buffer>, u64)]) {
        assert!(!buffers.is_empty(), "no vertex buffers to bind");
        for (buffer, _) in buffers {
            self.check_device(buffer.device_id(), "vertex buffer");
        }
        self.record(Operation::BindVertexBuffers {
            first_binding,
            buffers: buffers
                .iter()
                .map(|(buffer, offset)| ((*buffer).clone(), *offset))
                .collect(),
        });
    }

    pub fn bind_index_buffer(&mut self, buffer: &Arc<Buffer>, offset: u64, index_type: IndexType) {
        self.check_device(buffer.device_id(), "index buffer");
        self.record(Operation::BindIndexBuffer {
            buffer: buffer.clone(),
            offset,
            index_type,
        });
    }

    pub fn bind_descriptor_sets(
        &mut self,
        bind_point: PipelineBindPoint,
        layout: &Arc<PipelineLayout>,
        first_set: u32,
        sets: &[&Arc<DescriptorSet>],
        dynamic_offsets: &[u32],
    ) {
        assert!(!sets.is_empty(), "no descriptor sets to bind");
        assert!(
            first_set as usize + sets.len() <= layout.set_layouts().len(),
            "descriptor sets exceed the pipeline layout"
        );
        self.check_device(layout.device_id(), "pipeline layout");
        for set in sets {
            self.check_device(set.device_id(), "descriptor set");
        }
        self.record(Operation::BindDescriptorSets {
            bind_point,
            layout: layout.clone(),
            first_set,
            sets: sets.iter().map(|s| (*s).clone()).collect(),
            dynamic_offsets: dynamic_offsets.to_vec(),
        });
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.record(Operation::SetViewport(viewport));
    }

    pub fn set_scissor(&mut self, scissor: Rect2d) {
        self.record(Operation::SetScissor(scissor));
    }

    pub fn set_line_width(&mut self, width: f32) {
        self.record(Operation::SetLineWidth(width));
    }

    pub fn set_depth_bias(&mut self, constant_factor: f32, clamp: f32, slope_factor: f32) {
        self.record(Operation::SetDepthBias {
            constant_factor,
            clamp,
            slope_factor,
        });
    }

    pub fn set_blend_constants(&mut self, constants: [f32; 4]) {
        self.record(Operation::SetBlendConstants(constants));
    }

    pub fn set_stencil_reference(&mut self, faces: StencilFaceFlags, reference: u32) {
        self.record(Operation::SetStencilReference { faces, reference });
    }

    pub fn set_stencil_compare_mask(&mut self, faces: StencilFaceFlags, mask: u32) {
        self.record(Operation::SetStencilCompareMask { faces, mask });
    }

    pub fn set_stencil_write_mask(&mut self, faces: StencilFaceFlags, mask: u32) {
        self.record(Operation::SetStencilWriteMask { faces, mask });
    }

    pub fn draw(
        &mut self,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) {
        self.record(Operation::Draw {
            vertex_count,
            instance_count,
            first_vertex,
            first_instance,
        });
    }

    pub fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        self.record(Operation::DrawIndexed {
            index_count,
            instance_count,
            first_index,
            vertex_offset,
            first_instance,
        });
    }

    pub fn draw_indirect(&mut self, buffer: &Arc<Buffer>, offset: u64, draw_count: u32, stride: u32) {
        self.check_device(buffer.device_id(), "indirect buffer");
        self.record(Operation::DrawIndirect {
            buffer: buffer.clone(),
            offset,
            draw_count,
            stride,
        });
    }

    pub fn draw_indexed_indirect(
        &mut self,
        buffer: &Arc<Buffer>,
        offset: u64,
        draw_count: u32,
        stride: u32,
    ) {
        self.check_device(buffer.device_id(), "indirect buffer");
        self.record(Operation::DrawIndexedIndirect {
            buffer: buffer.clone(),
            offset,
            draw_count,
            stride,
        });
    }

    pub fn dispatch(&mut self, x: u32, y: u32, z: u32) {
        self.record(Operation::Dispatch { x, y, z });
    }

    pub fn dispatch_indirect(&mut self, buffer: &Arc<Buffer>, offset: u64) {
        self.check_device(buffer.device_id(), "indirect buffer");
        self.record(Operation::DispatchIndirect {
            buffer: buffer.clone(),
            offset,
        });
    }

    pub fn clear_colour_image(
        &mut self,
        image: &Arc<Image>,
        layout: ImageLayout,
        colour: ClearColourValue,
        ranges: &[ImageSubresourceRange],
    ) {
        assert!(!ranges.is_empty(), "no subresource ranges to clear");
        self.check_device(image.device_id(), "image");
        self.record(Operation::ClearColourImage {
            image: image.clone(),
            layout,
            colour,
            ranges: ranges.to_vec(),
        });
    }

    pub fn clear_depth_stencil_image(
        &mut self,
        image: &Arc<Image>,
        layout: ImageLayout,
        value: ClearDepthStencilValue,
        ranges: &[ImageSubresourceRange],
    ) {
        assert!(!ranges.is_empty(), "no subresource ranges to clear");
        self.check_device(image.device_id(), "image");
        self.record(Operation::ClearDepthStencilImage {
            image: image.clone(),
            layout,
            value,
            ranges: ranges.to_vec(),
        });
    }

    /// Clears regions of attachments of the current subpass.
    ///
    /// All attachments and rects are recorded as a single operation.
    pub fn clear_attachments(&mut self, attachments: &[ClearAttachment], rects: &[ClearRect]) {
        assert!(!attachments.is_empty(), "no attachments to clear");
        assert!(!rects.is_empty(), "no rects to clear");
        assert!(
            self.in_render_pass(),
            "clear_attachments outside of a render pass"
        );
        self.record(Operation::ClearAttachments {
            attachments: attachments.to_vec(),
            rects: rects.to_vec(),
        });
    }

    pub fn copy_buffer(&mut self, src: &Arc<Buffer>, dst: &Arc<Buffer>, regions: &[BufferCopy]) {
        assert!(!regions.is_empty(), "no regions to copy");
        self.check_device(src.device_id(), "source buffer");
        self.check_device(dst.device_id(), "destination buffer");
        self.record(Operation::CopyBuffer {
            src: src.clone(),
            dst: dst.clone(),
            regions: regions.to_vec(),
        });
    }

    pub fn copy_image(
        &mut self,
        src: &Arc<Image>,
        src_layout: ImageLayout,
        dst: &Arc<Image>,
        dst_layout: ImageLayout,
        regions: &[ImageCopy],
    ) {
        assert!(!regions.is_empty(), "no regions to copy");
        self.check_device(src.device_id(), "source image");
        self.check_device(dst.device_id(), "destination image");
        self.record(Operation::CopyImage {
            src: src.clone(),
            src_layout,
            dst: dst.clone(),
            dst_layout,
            regions: regions.to_vec(),
        });
    }

    pub fn copy_buffer_to_image(
        &mut self,
        src: &Arc<Buffer>,
        dst: &Arc<Image>,
        dst_layout: ImageLayout,
        regions: &[BufferImageCopy],
    ) {
        assert!(!regions.is_empty(), "no regions to copy");
        self.check_device(src.device_id(), "source buffer");
        self.check_device(dst.device_id(), "destination image");
        self.record(Operation::CopyBufferToImage {
            src: src.clone(),
            dst: dst.clone(),
            dst_layout,
            regions: regions.to_vec(),
        });
    }

    pub fn pipeline_barrier(
        &mut self,
        src_stage: PipelineStageFlags,
        dst_stage: PipelineStageFlags,
        dependency_flags: DependencyFlags,
        memory: &[MemoryBarrier],
        buffers: &[BufferMemoryBarrier],
        images: &[ImageMemoryBarrier],
    ) {
        for barrier in buffers {
            self.check_device(barrier.buffer.device_id(), "barrier buffer");
        }
        for barrier in images {
            self.check_device(barrier.image.device_id(), "barrier image");
        }
        self.record(Operation::PipelineBarrier {
            src_stage,
            dst_stage,
            dependency_flags,
            memory: memory.to_vec(),
            buffers: buffers.to_vec(),
            images: images.to_vec(),
        });
    }

    fn check_query(&self, pool: &QueryPool, query: u32) {
        self.check_device(pool.device_id(), "query pool");
        assert!(
            query < pool.query_count(),
            "query {query} outside of pool of {}",
            pool.query_count()
        );
    }

    pub fn reset_query_pool(&mut self, pool: &Arc<QueryPool>, first: u32, count: u32) {
        self.check_device(pool.device_id(), "query pool");
        assert!(
            first.saturating_add(count) <= pool.query_count(),
            "queries {first}+{count} outside of pool"
        );
        self.record(Operation::ResetQueryPool {
            pool: pool.clone(),
            first,
            count,
        });
    }

    pub fn begin_query(&mut self, pool: &Arc<QueryPool>, query: u32, flags: QueryControlFlags) {
        self.check_query(pool, query);
        self.record(Operation::BeginQuery {
            pool: pool.clone(),
            query,
            flags,
        });
    }

    pub fn end_query(&mut self, pool: &Arc<QueryPool>, query: u32) {
        self.check_query(pool, query);
        self.record(Operation::EndQuery {
            pool: pool.clone(),
            query,
        });
    }

    pub fn write_timestamp(&mut self, stage: PipelineStageFlags, pool: &Arc<QueryPool>, query: u32) {
        self.check_query(pool, query);
        self.record(Operation::WriteTimestamp {
            stage,
            pool: pool.clone(),
            query,
        });
    }

    /// Uploads push constants.
    ///
    /// # Panics
    ///
    /// Panics if `constants.data` is shorter than its declared constants.
    pub fn push_constants(&mut self, layout: &Arc<PipelineLayout>, constants: PushConstantsDesc) {
        self.check_device(layout.device_id(), "pipeline layout");
        assert!(
            constants.data.len() >= constants.required_size(),
            "push constant data holds {} bytes, constants need {}",
            constants.data.len(),
            constants.required_size()
        );
        self.record(Operation::PushConstants {
            layout: layout.clone(),
            constants,
        });
    }

    /// Executes secondary command buffers.
    ///
    /// The secondaries' current lists are captured; recording them again
    /// later does not change this buffer.
    pub fn execute_commands(&mut self, secondaries: &[&CommandBuffer]) {
        assert_eq!(
            self.level,
            CommandBufferLevel::Primary,
            "only primary command buffers execute secondaries"
        );
        assert!(!secondaries.is_empty(), "no command buffers to execute");
        let mut lists = Vec::with_capacity(secondaries.len());
        for secondary in secondaries {
            self.check_device(secondary.device_id(), "secondary command buffer");
            assert_eq!(
                secondary.level,
                CommandBufferLevel::Secondary,
                "execute_commands takes secondary command buffers"
            );
            let inner = secondary.inner.lock();
            assert_eq!(
                inner.state,
                CommandBufferState::Executable,
                "secondary command buffer is not executable"
            );
            lists.push(inner.list.clone());
        }
        self.record(Operation::ExecuteCommands { lists });
    }
}

impl Drop for CommandBuffer {
    fn drop(&mut self) {
        // The native command buffer is freed right after this.
        let serial = self.inner.get_mut().in_flight;
        if serial != 0 {
            if let Err(e) = self.device.wait_for_submission(serial) {
                log::error!("CommandBuffer: waiting for submission {serial} failed: {e}");
            }
        }
    }
}

impl std::fmt::Debug for CommandBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("CommandBuffer")
            .field("level", &self.level)
            .field("state", &inner.state)
            .field("operations", &inner.list.len())
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(CommandBuffer: Send, Sync);
