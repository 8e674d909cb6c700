//! Graphics device.
//!
//! The [`GraphicsDevice`] is the factory for every resource and owns the
//! backend that executes submissions. It is created by
//! [`GraphicsInstance::create_device`].
//!
//! [`GraphicsInstance::create_device`]: crate::GraphicsInstance::create_device

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU32, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use crate::backend::{
    BackendCapabilities, BackendType, DeviceBackend, GpuBuffer, GpuCommandBuffer, GpuFence,
    GpuFramebuffer, GpuImage, GpuImageView, GpuLayoutObject, GpuPipeline, GpuQueryPool,
    GpuSampler, GpuSemaphore, GpuSwapChain,
};
use crate::command::{
    CommandBuffer, CommandBufferLevel, PresentInfo, Queue, SubmitBatch, Submitted,
};
use crate::error::{GraphicsError, GraphicsResult};
use crate::resources::{
    Buffer, DescriptorSet, DescriptorSetLayout, Fence, Framebuffer, Image, ImageView, Pipeline,
    PipelineBuilder, PipelineDescriptor, PipelineLayout, QueryPool, RenderPass, Sampler,
    Semaphore, SwapChain, SwapChainDescriptor,
};
use crate::types::{
    BufferDescriptor, DescriptorSetLayoutBinding, Extent2d, ImageDescriptor,
    ImageViewDescriptor, PipelineBindPoint, PushConstantRange, QueryPoolDescriptor,
    RenderPassDescriptor, SamplerDescriptor, ShaderStage, ATTACHMENT_UNUSED,
    SUBPASS_EXTERNAL,
};

/// Identifies the device a resource was created by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId(u64);

impl DeviceId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Id of resources built directly in unit tests, owned by no device.
    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Self(0)
    }
}

/// A logical device.
///
/// Resources are tagged with the device's [`DeviceId`]; passing a resource
/// to another device panics. All queues share one submission lock, so
/// submissions from several threads execute one after the other.
///
/// # Example
///
/// ```ignore
/// let instance = GraphicsInstance::new(InstanceParameters::default())?;
/// let device = instance.create_device(Connection::headless())?;
///
/// let buffer = device.create_buffer(&BufferDescriptor::new(1024, BufferUsageFlags::VERTEX))?;
/// let mut cmd = device.create_command_buffer(CommandBufferLevel::Primary)?;
/// ```
pub struct GraphicsDevice {
    id: DeviceId,
    backend_type: BackendType,
    backend: DeviceBackend,
    capabilities: BackendCapabilities,
    graphics_family: u32,
    present_family: u32,
    lost: AtomicBool,
    /// Serialises submissions and presentation across all queues.
    pub(crate) submit_lock: Mutex<()>,
    executed: AtomicU64,
    // Weak references for the live-resource counters.
    buffers: RwLock<Vec<Weak<Buffer>>>,
    images: RwLock<Vec<Weak<Image>>>,
    pipelines: RwLock<Vec<Weak<Pipeline>>>,
    command_buffers: AtomicU32,
}

impl GraphicsDevice {
    pub(crate) fn new(
        backend_type: BackendType,
        backend: DeviceBackend,
        graphics_family: u32,
        present_family: u32,
    ) -> Self {
        let capabilities = match &backend {
            DeviceBackend::Test(_) => BackendCapabilities::full(),
            DeviceBackend::Gl(gl) => *gl.capabilities(),
            #[cfg(feature = "vulkan-backend")]
            DeviceBackend::Vulkan(vulkan) => *vulkan.capabilities(),
        };
        let id = DeviceId::next();
        log::info!("GraphicsDevice {id:?}: created on {} backend", backend_type.name());
        Self {
            id,
            backend_type,
            backend,
            capabilities,
            graphics_family,
            present_family,
            lost: AtomicBool::new(false),
            submit_lock: Mutex::new(()),
            executed: AtomicU64::new(0),
            buffers: RwLock::new(Vec::new()),
            images: RwLock::new(Vec::new()),
            pipelines: RwLock::new(Vec::new()),
            command_buffers: AtomicU32::new(0),
        }
    }

    /// Unique id of this device.
    pub fn id(&self) -> DeviceId {
        self.id
    }

    /// The backend this device runs on.
    pub fn backend_type(&self) -> BackendType {
        self.backend_type
    }

    /// What the backend can express.
    pub fn capabilities(&self) -> &BackendCapabilities {
        &self.capabilities
    }

    /// Whether the device was lost. A lost device fails every submission.
    pub fn is_lost(&self) -> bool {
        if self.lost.load(Ordering::Acquire) {
            return true;
        }
        match &self.backend {
            DeviceBackend::Gl(gl) => gl.context().is_lost(),
            _ => false,
        }
    }

    pub(crate) fn mark_lost(&self) {
        if !self.lost.swap(true, Ordering::AcqRel) {
            log::error!("GraphicsDevice {:?}: device lost", self.id);
        }
    }

    pub(crate) fn record_executed(&self, count: u64) {
        self.executed.fetch_add(count, Ordering::Relaxed);
    }

    /// Total number of operations executed by all submissions so far.
    ///
    /// Operations of secondary command buffers count individually, in
    /// addition to the `ExecuteCommands` operation that runs them. On Vulkan
    /// this counts the operations forwarded to the driver.
    pub fn executed_operation_count(&self) -> u64 {
        self.executed.load(Ordering::Relaxed)
    }

    /// Names of the operations the Test backend executed, in order.
    ///
    /// Empty on every other backend.
    pub fn executed_operation_names(&self) -> Vec<&'static str> {
        match &self.backend {
            DeviceBackend::Test(test) => test.executed(),
            _ => Vec::new(),
        }
    }

    /// Number of images presented on the Test backend.
    pub fn present_count(&self) -> u64 {
        match &self.backend {
            DeviceBackend::Test(test) => test.present_count(),
            _ => 0,
        }
    }

    /// The GL context of a Gl3 / Gl4 device.
    pub fn gl_context(&self) -> Option<&Arc<crate::backend::gl::GlContext>> {
        match &self.backend {
            DeviceBackend::Gl(gl) => Some(gl.context()),
            _ => None,
        }
    }

    // ========================================================================
    // Queues and submission
    // ========================================================================

    /// The graphics queue.
    pub fn graphics_queue(self: &Arc<Self>) -> Queue {
        Queue::new(Arc::clone(self), self.graphics_family)
    }

    /// The presentation queue; the graphics queue on emulated backends.
    pub fn present_queue(self: &Arc<Self>) -> Queue {
        Queue::new(Arc::clone(self), self.present_family)
    }

    /// Blocks until all submitted work has finished.
    ///
    /// # Errors
    ///
    /// [`GraphicsError::DeviceLost`] if the device is lost.
    pub fn wait_idle(&self) -> GraphicsResult<()> {
        if self.is_lost() {
            return Err(GraphicsError::DeviceLost);
        }
        let result = match &self.backend {
            DeviceBackend::Test(_) => Ok(()),
            DeviceBackend::Gl(gl) => gl.wait_idle(),
            #[cfg(feature = "vulkan-backend")]
            DeviceBackend::Vulkan(vulkan) => vulkan.wait_idle(),
        };
        if let Err(e) = &result {
            if e.is_device_lost() {
                self.mark_lost();
            }
        }
        result
    }

    pub(crate) fn backend_submit(
        &self,
        batches: &[SubmitBatch<'_>],
        fence: Option<&Fence>,
    ) -> GraphicsResult<Submitted> {
        match &self.backend {
            DeviceBackend::Test(test) => test.submit(batches, fence).map(Submitted::completed),
            DeviceBackend::Gl(gl) => gl.submit(batches, fence).map(Submitted::completed),
            #[cfg(feature = "vulkan-backend")]
            DeviceBackend::Vulkan(vulkan) => vulkan.submit(batches, fence),
        }
    }

    /// Whether the submission with serial `serial` has finished on the GPU.
    ///
    /// Only Vulkan submissions outlive `Queue::submit`; a lost device
    /// finishes nothing further, so its submissions count as finished.
    pub(crate) fn submission_finished(&self, serial: u64) -> bool {
        match &self.backend {
            #[cfg(feature = "vulkan-backend")]
            DeviceBackend::Vulkan(vulkan) => match vulkan.poll_submissions() {
                Ok(completed) => completed >= serial,
                Err(e) => {
                    log::error!("GraphicsDevice: polling submission {serial} failed: {e}");
                    if e.is_device_lost() {
                        self.mark_lost();
                    }
                    true
                }
            },
            _ => {
                let _ = serial;
                true
            }
        }
    }

    /// Blocks until the submission with serial `serial` has finished.
    pub(crate) fn wait_for_submission(&self, serial: u64) -> GraphicsResult<()> {
        let result = match &self.backend {
            #[cfg(feature = "vulkan-backend")]
            DeviceBackend::Vulkan(vulkan) => vulkan.wait_for_submission(serial),
            _ => {
                let _ = serial;
                Ok(())
            }
        };
        if let Err(e) = &result {
            if e.is_device_lost() {
                self.mark_lost();
            }
        }
        result
    }

    pub(crate) fn backend_present(&self, info: &PresentInfo<'_>) -> GraphicsResult<()> {
        match &self.backend {
            DeviceBackend::Test(test) => test.present(info),
            DeviceBackend::Gl(gl) => gl.present(info),
            #[cfg(feature = "vulkan-backend")]
            DeviceBackend::Vulkan(vulkan) => vulkan.present(info),
        }
    }

    fn check_owner(&self, owner: DeviceId, what: &str) {
        assert_eq!(owner, self.id, "{what} belongs to another device");
    }

    // ========================================================================
    // Memory resources
    // ========================================================================

    /// Create a buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the size is zero or exceeds the device limit, or
    /// if the native allocation fails.
    pub fn create_buffer(&self, descriptor: &BufferDescriptor) -> GraphicsResult<Arc<Buffer>> {
        if descriptor.size == 0 {
            return Err(GraphicsError::InvalidParameter(
                "buffer size cannot be zero".to_string(),
            ));
        }
        if descriptor.size > self.capabilities.max_buffer_size {
            return Err(GraphicsError::InvalidParameter(format!(
                "buffer size {} exceeds maximum {}",
                descriptor.size, self.capabilities.max_buffer_size
            )));
        }

        let gpu = match &self.backend {
            DeviceBackend::Test(_) => GpuBuffer::Test {
                memory: Mutex::new(vec![0; descriptor.size as usize]),
            },
            DeviceBackend::Gl(gl) => gl.create_buffer(descriptor)?,
            #[cfg(feature = "vulkan-backend")]
            DeviceBackend::Vulkan(vulkan) => vulkan.create_buffer(descriptor)?,
        };
        let buffer = Arc::new(Buffer::new(self.id, descriptor.clone(), gpu));
        self.buffers.write().push(Arc::downgrade(&buffer));

        log::trace!(
            "GraphicsDevice: created buffer {:?}, size={}",
            descriptor.label,
            descriptor.size
        );
        Ok(buffer)
    }

    /// Create an image.
    ///
    /// # Errors
    ///
    /// Returns an error if a dimension is zero or exceeds the device limit,
    /// or if the native allocation fails.
    pub fn create_image(&self, descriptor: &ImageDescriptor) -> GraphicsResult<Arc<Image>> {
        let extent = descriptor.extent;
        if extent.width == 0 || extent.height == 0 || extent.depth == 0 {
            return Err(GraphicsError::InvalidParameter(
                "image dimensions cannot be zero".to_string(),
            ));
        }
        let max_dim = self.capabilities.max_image_dimension;
        if extent.width > max_dim || extent.height > max_dim || extent.depth > max_dim {
            return Err(GraphicsError::InvalidParameter(format!(
                "image dimension exceeds maximum {max_dim}"
            )));
        }
        if descriptor.mip_levels == 0 || descriptor.array_layers == 0 {
            return Err(GraphicsError::InvalidParameter(
                "image needs at least one mip level and one layer".to_string(),
            ));
        }

        let gpu = match &self.backend {
            DeviceBackend::Test(_) => GpuImage::Test,
            DeviceBackend::Gl(gl) => gl.create_image(descriptor)?,
            #[cfg(feature = "vulkan-backend")]
            DeviceBackend::Vulkan(vulkan) => vulkan.create_image(descriptor)?,
        };
        let image = Arc::new(Image::new(self.id, descriptor.clone(), gpu));
        self.images.write().push(Arc::downgrade(&image));

        log::trace!(
            "GraphicsDevice: created image {:?}, {}x{}x{} {:?}",
            descriptor.label,
            extent.width,
            extent.height,
            extent.depth,
            descriptor.format
        );
        Ok(image)
    }

    /// Create a view of `image`.
    ///
    /// # Errors
    ///
    /// Returns an error if the subresource range lies outside the image.
    pub fn create_image_view(
        &self,
        image: &Arc<Image>,
        descriptor: &ImageViewDescriptor,
    ) -> GraphicsResult<Arc<ImageView>> {
        self.check_owner(image.device_id(), "image");
        if let Some(range) = descriptor.subresource_range {
            let levels_end = range.base_mip_level.checked_add(range.level_count);
            let layers_end = range.base_array_layer.checked_add(range.layer_count);
            let in_bounds = matches!(levels_end, Some(end) if end <= image.mip_levels())
                && matches!(layers_end, Some(end) if end <= image.array_layers());
            if !in_bounds || range.level_count == 0 || range.layer_count == 0 {
                return Err(GraphicsError::InvalidParameter(format!(
                    "subresource range {range:?} outside image {:?}",
                    image.label()
                )));
            }
        }

        let gpu = match &self.backend {
            DeviceBackend::Test(_) => GpuImageView::Test,
            DeviceBackend::Gl(gl) => gl.create_image_view(image, descriptor)?,
            #[cfg(feature = "vulkan-backend")]
            DeviceBackend::Vulkan(vulkan) => vulkan.create_image_view(image, descriptor)?,
        };
        log::trace!("GraphicsDevice: created image view {:?}", descriptor.label);
        Ok(Arc::new(ImageView::new(Arc::clone(image), descriptor.clone(), gpu)))
    }

    /// Create a sampler.
    ///
    /// # Errors
    ///
    /// Returns an error if native sampler creation fails.
    pub fn create_sampler(&self, descriptor: &SamplerDescriptor) -> GraphicsResult<Arc<Sampler>> {
        let gpu = match &self.backend {
            DeviceBackend::Test(_) => GpuSampler::Test,
            DeviceBackend::Gl(gl) => gl.create_sampler(descriptor)?,
            #[cfg(feature = "vulkan-backend")]
            DeviceBackend::Vulkan(vulkan) => vulkan.create_sampler(descriptor)?,
        };
        log::trace!("GraphicsDevice: created sampler {:?}", descriptor.label);
        Ok(Arc::new(Sampler::new(self.id, descriptor.clone(), gpu)))
    }

    /// Create a pool of queries.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool is empty or native creation fails.
    pub fn create_query_pool(
        &self,
        descriptor: &QueryPoolDescriptor,
    ) -> GraphicsResult<Arc<QueryPool>> {
        if descriptor.query_count == 0 {
            return Err(GraphicsError::InvalidParameter(
                "query pool cannot be empty".to_string(),
            ));
        }
        let gpu = match &self.backend {
            DeviceBackend::Test(_) => GpuQueryPool::Test,
            DeviceBackend::Gl(gl) => gl.create_query_pool(descriptor)?,
            #[cfg(feature = "vulkan-backend")]
            DeviceBackend::Vulkan(vulkan) => vulkan.create_query_pool(descriptor)?,
        };
        log::trace!(
            "GraphicsDevice: created {:?} query pool, count={}",
            descriptor.query_type,
            descriptor.query_count
        );
        Ok(Arc::new(QueryPool::new(self.id, descriptor.clone(), gpu)))
    }

    // ========================================================================
    // Render passes
    // ========================================================================

    /// Create a render pass.
    ///
    /// # Errors
    ///
    /// Returns an error if a subpass or dependency references an attachment
    /// or subpass that does not exist.
    pub fn create_render_pass(
        &self,
        descriptor: &RenderPassDescriptor,
    ) -> GraphicsResult<Arc<RenderPass>> {
        validate_render_pass(descriptor)?;
        let gpu = match &self.backend {
            DeviceBackend::Test(_) | DeviceBackend::Gl(_) => GpuLayoutObject::Emulated,
            #[cfg(feature = "vulkan-backend")]
            DeviceBackend::Vulkan(vulkan) => vulkan.create_render_pass(descriptor)?,
        };
        log::trace!(
            "GraphicsDevice: created render pass {:?} ({} attachments, {} subpasses)",
            descriptor.label,
            descriptor.attachments.len(),
            descriptor.subpasses.len()
        );
        Ok(Arc::new(RenderPass::new(self.id, descriptor.clone(), gpu)))
    }

    /// Create a framebuffer for `render_pass` from one view per attachment.
    ///
    /// # Errors
    ///
    /// Returns an error if the attachment count does not match the render
    /// pass or the native framebuffer is incomplete.
    pub fn create_framebuffer(
        &self,
        render_pass: &Arc<RenderPass>,
        attachments: &[Arc<ImageView>],
        extent: Extent2d,
        layers: u32,
    ) -> GraphicsResult<Arc<Framebuffer>> {
        self.check_owner(render_pass.device_id(), "render pass");
        for view in attachments {
            self.check_owner(view.device_id(), "attachment");
        }
        if attachments.len() != render_pass.attachments().len() {
            return Err(GraphicsError::InvalidParameter(format!(
                "render pass has {} attachments, {} views given",
                render_pass.attachments().len(),
                attachments.len()
            )));
        }
        if extent.width == 0 || extent.height == 0 || layers == 0 {
            return Err(GraphicsError::InvalidParameter(
                "framebuffer dimensions cannot be zero".to_string(),
            ));
        }

        let gpu = match &self.backend {
            DeviceBackend::Test(_) => GpuFramebuffer::Test,
            DeviceBackend::Gl(gl) => gl.create_framebuffer(render_pass, attachments)?,
            #[cfg(feature = "vulkan-backend")]
            DeviceBackend::Vulkan(vulkan) => {
                vulkan.create_framebuffer(render_pass, attachments, extent, layers)?
            }
        };
        log::trace!(
            "GraphicsDevice: created framebuffer {}x{} ({} attachments)",
            extent.width,
            extent.height,
            attachments.len()
        );
        Ok(Arc::new(Framebuffer::new(
            self.id,
            Arc::clone(render_pass),
            attachments.to_vec(),
            extent,
            layers,
            gpu,
        )))
    }

    // ========================================================================
    // Descriptors and pipelines
    // ========================================================================

    /// Create a descriptor set layout.
    ///
    /// # Errors
    ///
    /// Returns an error if a binding number repeats or has a zero count.
    pub fn create_descriptor_set_layout(
        &self,
        bindings: &[DescriptorSetLayoutBinding],
    ) -> GraphicsResult<Arc<DescriptorSetLayout>> {
        for (i, binding) in bindings.iter().enumerate() {
            if binding.count == 0 {
                return Err(GraphicsError::InvalidParameter(format!(
                    "binding {} has a zero descriptor count",
                    binding.binding
                )));
            }
            if bindings[..i].iter().any(|b| b.binding == binding.binding) {
                return Err(GraphicsError::InvalidParameter(format!(
                    "binding {} declared twice",
                    binding.binding
                )));
            }
        }
        let gpu = match &self.backend {
            DeviceBackend::Test(_) | DeviceBackend::Gl(_) => GpuLayoutObject::Emulated,
            #[cfg(feature = "vulkan-backend")]
            DeviceBackend::Vulkan(vulkan) => vulkan.create_set_layout(bindings)?,
        };
        log::trace!(
            "GraphicsDevice: created descriptor set layout ({} bindings)",
            bindings.len()
        );
        Ok(Arc::new(DescriptorSetLayout::new(self.id, bindings.to_vec(), gpu)))
    }

    /// Create a pipeline layout from set layouts and push constant ranges.
    ///
    /// # Errors
    ///
    /// Returns an error if native creation fails.
    pub fn create_pipeline_layout(
        &self,
        set_layouts: &[Arc<DescriptorSetLayout>],
        push_constant_ranges: &[PushConstantRange],
    ) -> GraphicsResult<Arc<PipelineLayout>> {
        for layout in set_layouts {
            self.check_owner(layout.device_id(), "descriptor set layout");
        }
        let gpu = match &self.backend {
            DeviceBackend::Test(_) | DeviceBackend::Gl(_) => GpuLayoutObject::Emulated,
            #[cfg(feature = "vulkan-backend")]
            DeviceBackend::Vulkan(vulkan) => {
                vulkan.create_pipeline_layout(set_layouts, push_constant_ranges)?
            }
        };
        log::trace!(
            "GraphicsDevice: created pipeline layout ({} sets, {} push constant ranges)",
            set_layouts.len(),
            push_constant_ranges.len()
        );
        Ok(Arc::new(PipelineLayout::new(
            self.id,
            set_layouts.to_vec(),
            push_constant_ranges.to_vec(),
            gpu,
        )))
    }

    /// Allocate a descriptor set.
    ///
    /// # Errors
    ///
    /// Returns an error if the native allocation fails.
    pub fn create_descriptor_set(
        &self,
        layout: &Arc<DescriptorSetLayout>,
    ) -> GraphicsResult<Arc<DescriptorSet>> {
        self.check_owner(layout.device_id(), "descriptor set layout");
        let gpu = match &self.backend {
            DeviceBackend::Test(_) | DeviceBackend::Gl(_) => GpuLayoutObject::Emulated,
            #[cfg(feature = "vulkan-backend")]
            DeviceBackend::Vulkan(vulkan) => vulkan.create_descriptor_set(layout)?,
        };
        log::trace!("GraphicsDevice: allocated descriptor set");
        Ok(Arc::new(DescriptorSet::new(self.id, Arc::clone(layout), gpu)))
    }

    /// Start describing a graphics pipeline used in `subpass` of
    /// `render_pass`.
    pub fn create_graphics_pipeline(
        self: &Arc<Self>,
        layout: &Arc<PipelineLayout>,
        render_pass: &Arc<RenderPass>,
        subpass: u32,
    ) -> PipelineBuilder {
        self.check_owner(layout.device_id(), "pipeline layout");
        self.check_owner(render_pass.device_id(), "render pass");
        PipelineBuilder::graphics(
            Arc::clone(self),
            Arc::clone(layout),
            Arc::clone(render_pass),
            subpass,
        )
    }

    /// Start describing a compute pipeline.
    pub fn create_compute_pipeline(
        self: &Arc<Self>,
        layout: &Arc<PipelineLayout>,
        stage: ShaderStage,
    ) -> PipelineBuilder {
        self.check_owner(layout.device_id(), "pipeline layout");
        PipelineBuilder::compute(Arc::clone(self), Arc::clone(layout), stage)
    }

    pub(crate) fn build_pipeline(
        &self,
        layout: Arc<PipelineLayout>,
        descriptor: PipelineDescriptor,
    ) -> GraphicsResult<Arc<Pipeline>> {
        if descriptor.bind_point == PipelineBindPoint::Compute && !self.capabilities.compute {
            return Err(GraphicsError::FeatureNotSupported(format!(
                "compute pipelines on the {} backend",
                self.backend_type.name()
            )));
        }
        if descriptor.state.tessellation.is_some() && !self.capabilities.tessellation {
            return Err(GraphicsError::FeatureNotSupported(format!(
                "tessellation on the {} backend",
                self.backend_type.name()
            )));
        }

        let gpu = match &self.backend {
            DeviceBackend::Test(_) => GpuPipeline::Test,
            DeviceBackend::Gl(gl) => gl.create_pipeline(&descriptor)?,
            #[cfg(feature = "vulkan-backend")]
            DeviceBackend::Vulkan(vulkan) => vulkan.create_pipeline(&layout, &descriptor)?,
        };
        log::trace!(
            "GraphicsDevice: created {:?} pipeline {:?}",
            descriptor.bind_point,
            descriptor.label
        );
        let pipeline = Arc::new(Pipeline::new(self.id, layout, descriptor, gpu));
        self.pipelines.write().push(Arc::downgrade(&pipeline));
        Ok(pipeline)
    }

    // ========================================================================
    // Synchronisation and commands
    // ========================================================================

    /// Create a semaphore.
    ///
    /// # Errors
    ///
    /// Returns an error if native creation fails.
    pub fn create_semaphore(&self) -> GraphicsResult<Arc<Semaphore>> {
        let gpu = match &self.backend {
            DeviceBackend::Test(_) | DeviceBackend::Gl(_) => GpuSemaphore::Emulated {
                signaled: AtomicBool::new(false),
            },
            #[cfg(feature = "vulkan-backend")]
            DeviceBackend::Vulkan(vulkan) => vulkan.create_semaphore()?,
        };
        Ok(Arc::new(Semaphore::new(self.id, gpu)))
    }

    /// Create a fence, optionally already signaled.
    ///
    /// # Errors
    ///
    /// Returns an error if native creation fails.
    pub fn create_fence(&self, signaled: bool) -> GraphicsResult<Arc<Fence>> {
        let gpu = match &self.backend {
            DeviceBackend::Test(_) => GpuFence::Test {
                signaled: AtomicBool::new(signaled),
            },
            DeviceBackend::Gl(gl) => gl.create_fence(signaled),
            #[cfg(feature = "vulkan-backend")]
            DeviceBackend::Vulkan(vulkan) => vulkan.create_fence(signaled)?,
        };
        Ok(Arc::new(Fence::new(self.id, gpu)))
    }

    /// Create a command buffer in the initial state.
    ///
    /// # Errors
    ///
    /// Returns an error if the native command buffer cannot be allocated.
    pub fn create_command_buffer(
        self: &Arc<Self>,
        level: CommandBufferLevel,
    ) -> GraphicsResult<CommandBuffer> {
        let gpu = match &self.backend {
            DeviceBackend::Test(_) | DeviceBackend::Gl(_) => GpuCommandBuffer::Emulated,
            // Secondaries are expanded inline into their primary on Vulkan.
            #[cfg(feature = "vulkan-backend")]
            DeviceBackend::Vulkan(_) if level == CommandBufferLevel::Secondary => {
                GpuCommandBuffer::Emulated
            }
            #[cfg(feature = "vulkan-backend")]
            DeviceBackend::Vulkan(vulkan) => vulkan.create_command_buffer()?,
        };
        self.command_buffers.fetch_add(1, Ordering::Relaxed);
        log::trace!("GraphicsDevice: created {level:?} command buffer");
        Ok(CommandBuffer::new(Arc::clone(self), level, gpu))
    }

    /// Create a swap chain.
    ///
    /// Best effort: a native failure is logged and yields `None`.
    pub fn create_swap_chain(&self, descriptor: &SwapChainDescriptor) -> Option<Arc<SwapChain>> {
        match self.try_create_swap_chain(descriptor) {
            Ok(swap_chain) => {
                log::info!(
                    "GraphicsDevice: created swap chain {}x{} {:?} ({} images)",
                    swap_chain.extent().width,
                    swap_chain.extent().height,
                    swap_chain.format(),
                    swap_chain.images().len()
                );
                Some(Arc::new(swap_chain))
            }
            Err(e) => {
                log::error!("GraphicsDevice: swap chain creation failed: {e}");
                None
            }
        }
    }

    fn try_create_swap_chain(&self, descriptor: &SwapChainDescriptor) -> GraphicsResult<SwapChain> {
        let extent = descriptor.extent;
        if extent.width == 0 || extent.height == 0 || descriptor.image_count == 0 {
            return Err(GraphicsError::InvalidParameter(format!(
                "degenerate swap chain {}x{} with {} images",
                extent.width, extent.height, descriptor.image_count
            )));
        }

        let emulated = || GpuSwapChain::Emulated {
            next: AtomicU32::new(0),
        };
        let image_descriptor = |index: u32| {
            ImageDescriptor::new_2d(
                extent.width,
                extent.height,
                descriptor.format,
                descriptor.usage,
            )
            .with_label(format!("swap chain image {index}"))
        };

        match &self.backend {
            DeviceBackend::Test(_) => {
                let images = (0..descriptor.image_count)
                    .map(|i| Arc::new(Image::new(self.id, image_descriptor(i), GpuImage::Test)))
                    .collect();
                Ok(SwapChain::new(self.id, *descriptor, images, emulated()))
            }
            DeviceBackend::Gl(gl) => {
                let images = (0..descriptor.image_count)
                    .map(|i| {
                        let image_descriptor = image_descriptor(i);
                        let gpu = gl.create_image(&image_descriptor)?;
                        Ok(Arc::new(Image::new(self.id, image_descriptor, gpu)))
                    })
                    .collect::<GraphicsResult<Vec<_>>>()?;
                Ok(SwapChain::new(self.id, *descriptor, images, emulated()))
            }
            #[cfg(feature = "vulkan-backend")]
            DeviceBackend::Vulkan(vulkan) => {
                let (gpu, actual, native_images) = vulkan.create_swap_chain(descriptor)?;
                let images = native_images
                    .into_iter()
                    .enumerate()
                    .map(|(i, image)| {
                        let mut image_descriptor = image_descriptor(i as u32);
                        image_descriptor.extent.width = actual.extent.width;
                        image_descriptor.extent.height = actual.extent.height;
                        image_descriptor.format = actual.format;
                        Arc::new(Image::new(
                            self.id,
                            image_descriptor,
                            GpuImage::VulkanSwapchain { image },
                        ))
                    })
                    .collect();
                Ok(SwapChain::new(self.id, actual, images, gpu))
            }
        }
    }

    // ========================================================================
    // Live-resource counters
    // ========================================================================

    /// Number of live buffers created by this device.
    pub fn buffer_count(&self) -> usize {
        self.buffers.read().iter().filter(|w| w.strong_count() > 0).count()
    }

    /// Number of live images created by this device.
    pub fn image_count(&self) -> usize {
        self.images.read().iter().filter(|w| w.strong_count() > 0).count()
    }

    /// Number of live pipelines created by this device.
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.read().iter().filter(|w| w.strong_count() > 0).count()
    }

    /// Number of command buffers ever created by this device.
    pub fn command_buffers_created(&self) -> u32 {
        self.command_buffers.load(Ordering::Relaxed)
    }

    /// Clean up dead weak references to released resources.
    pub fn cleanup_dead_resources(&self) {
        self.buffers.write().retain(|w| w.strong_count() > 0);
        self.images.write().retain(|w| w.strong_count() > 0);
        self.pipelines.write().retain(|w| w.strong_count() > 0);
    }
}

fn validate_render_pass(descriptor: &RenderPassDescriptor) -> GraphicsResult<()> {
    if descriptor.subpasses.is_empty() {
        return Err(GraphicsError::InvalidParameter(
            "render pass needs at least one subpass".to_string(),
        ));
    }
    let attachment_count = descriptor.attachments.len() as u32;
    for (index, subpass) in descriptor.subpasses.iter().enumerate() {
        let references = subpass
            .input_attachments
            .iter()
            .chain(&subpass.colour_attachments)
            .chain(&subpass.resolve_attachments)
            .chain(subpass.depth_stencil_attachment.as_ref());
        for reference in references {
            if reference.attachment != ATTACHMENT_UNUSED && reference.attachment >= attachment_count {
                return Err(GraphicsError::InvalidParameter(format!(
                    "subpass {index} references attachment {} of {attachment_count}",
                    reference.attachment
                )));
            }
        }
        if !subpass.resolve_attachments.is_empty()
            && subpass.resolve_attachments.len() != subpass.colour_attachments.len()
        {
            return Err(GraphicsError::InvalidParameter(format!(
                "subpass {index} has {} resolve attachments for {} colour attachments",
                subpass.resolve_attachments.len(),
                subpass.colour_attachments.len()
            )));
        }
    }
    let subpass_count = descriptor.subpasses.len() as u32;
    for dependency in &descriptor.dependencies {
        for subpass in [dependency.src_subpass, dependency.dst_subpass] {
            if subpass != SUBPASS_EXTERNAL && subpass >= subpass_count {
                return Err(GraphicsError::InvalidParameter(format!(
                    "dependency references subpass {subpass} of {subpass_count}"
                )));
            }
        }
    }
    Ok(())
}

impl std::fmt::Debug for GraphicsDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphicsDevice")
            .field("id", &self.id)
            .field("backend", &self.backend)
            .field("lost", &self.is_lost())
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(GraphicsDevice: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::test::TestBackend;
    use crate::types::{
        AttachmentDescription, AttachmentReference, BufferUsageFlags, Format, ImageLayout,
        ImageUsageFlags, SubpassDescription,
    };

    fn create_test_device() -> Arc<GraphicsDevice> {
        Arc::new(GraphicsDevice::new(
            BackendType::Test,
            DeviceBackend::Test(TestBackend::new()),
            0,
            0,
        ))
    }

    #[test]
    fn test_device_ids_are_unique() {
        let a = create_test_device();
        let b = create_test_device();
        assert_ne!(a.id(), b.id());
        assert_ne!(a.id(), DeviceId::for_tests());
    }

    #[test]
    fn test_create_buffer() {
        let device = create_test_device();
        let buffer = device
            .create_buffer(&BufferDescriptor::new(1024, BufferUsageFlags::VERTEX))
            .unwrap();
        assert_eq!(buffer.size(), 1024);
        assert_eq!(buffer.device_id(), device.id());
        assert_eq!(device.buffer_count(), 1);
    }

    #[test]
    fn test_create_buffer_zero_size() {
        let device = create_test_device();
        let result = device.create_buffer(&BufferDescriptor::new(0, BufferUsageFlags::VERTEX));
        assert!(matches!(result, Err(GraphicsError::InvalidParameter(_))));
    }

    #[test]
    fn test_create_image_zero_size() {
        let device = create_test_device();
        let result = device.create_image(&ImageDescriptor::new_2d(
            0,
            512,
            Format::Rgba8Unorm,
            ImageUsageFlags::SAMPLED,
        ));
        assert!(result.is_err());
    }

    #[test]
    fn test_image_view_range_outside_image() {
        let device = create_test_device();
        let image = device
            .create_image(&ImageDescriptor::new_2d(
                64,
                64,
                Format::Rgba8Unorm,
                ImageUsageFlags::SAMPLED,
            ))
            .unwrap();
        let mut range = image.full_range();
        range.base_mip_level = 1;
        let result =
            device.create_image_view(&image, &ImageViewDescriptor::new().with_subresource_range(range));
        assert!(matches!(result, Err(GraphicsError::InvalidParameter(_))));
    }

    #[test]
    fn test_resource_cleanup() {
        let device = create_test_device();
        {
            let _buffer = device
                .create_buffer(&BufferDescriptor::new(16, BufferUsageFlags::UNIFORM))
                .unwrap();
            assert_eq!(device.buffer_count(), 1);
        }
        device.cleanup_dead_resources();
        assert_eq!(device.buffer_count(), 0);
    }

    #[test]
    fn test_render_pass_rejects_missing_attachment() {
        let device = create_test_device();
        let descriptor = RenderPassDescriptor::new(
            vec![AttachmentDescription::cleared(
                Format::Rgba8Unorm,
                ImageLayout::PresentSrc,
            )],
            vec![SubpassDescription::new(vec![AttachmentReference::new(
                1,
                ImageLayout::ColourAttachmentOptimal,
            )])],
        );
        assert!(device.create_render_pass(&descriptor).is_err());
    }

    #[test]
    fn test_framebuffer_attachment_count_mismatch() {
        let device = create_test_device();
        let pass = device
            .create_render_pass(&RenderPassDescriptor::new(
                vec![AttachmentDescription::cleared(
                    Format::Rgba8Unorm,
                    ImageLayout::PresentSrc,
                )],
                vec![SubpassDescription::new(vec![AttachmentReference::new(
                    0,
                    ImageLayout::ColourAttachmentOptimal,
                )])],
            ))
            .unwrap();
        let result = device.create_framebuffer(&pass, &[], Extent2d::new(8, 8), 1);
        assert!(matches!(result, Err(GraphicsError::InvalidParameter(_))));
    }

    #[test]
    fn test_swap_chain_cycles_images() {
        let device = create_test_device();
        let swap_chain = device
            .create_swap_chain(&SwapChainDescriptor::new(64, 32, Format::Bgra8Unorm).with_image_count(3))
            .unwrap();
        assert_eq!(swap_chain.images().len(), 3);
        let indices: Vec<u32> = (0..4)
            .map(|_| {
                swap_chain
                    .acquire_next_image(std::time::Duration::from_secs(1), None, None)
                    .unwrap()
            })
            .collect();
        assert_eq!(indices, vec![0, 1, 2, 0]);
    }

    #[test]
    fn test_swap_chain_failure_yields_none() {
        let device = create_test_device();
        assert!(device
            .create_swap_chain(&SwapChainDescriptor::new(0, 0, Format::Bgra8Unorm))
            .is_none());
    }

    #[test]
    fn test_queues_share_device() {
        let device = create_test_device();
        let queue = device.graphics_queue();
        assert_eq!(queue.family_index(), 0);
        assert_eq!(queue.device().id(), device.id());
    }
}
