//! Native Vulkan backend using ash.
//!
//! Unlike the GL backends, nothing is replayed here: recorded command lists
//! are forwarded into native command buffers when recording ends, and
//! submission hands those buffers to the graphics queue. Memory comes from
//! gpu-allocator.
//!
//! Every resource holds a clone of the `ash::Device` and destroys its own
//! handle on drop, so resources must be dropped before their device.

mod allocator;
mod command;
pub(crate) mod conversion;
mod debug;
mod device;
mod instance;
mod pipeline;
mod swapchain;
mod sync;

use std::mem::ManuallyDrop;
use std::sync::Arc;

use ash::vk;
use gpu_allocator::vulkan::Allocator;
use parking_lot::Mutex;

use self::conversion::{
    convert_address_mode, convert_border_colour, convert_buffer_usage, convert_compare_op,
    convert_components, convert_extent_3d, convert_filter, convert_format, convert_image_type,
    convert_image_usage, convert_mipmap_mode, convert_pipeline_stages,
    convert_query_result_flags, convert_query_type, convert_samples,
    convert_subresource_range, convert_view_type,
};
use self::sync::SubmissionTracker;
use super::{
    BackendCapabilities, GpuBuffer, GpuCommandBuffer, GpuFence, GpuFramebuffer, GpuImage,
    GpuImageView, GpuLayoutObject, GpuPipeline, GpuQueryPool, GpuSampler, GpuSemaphore,
    GpuSwapChain,
};
use crate::command::{CommandList, Operation, PresentInfo, SubmitBatch, Submitted};
use crate::error::{GraphicsError, GraphicsResult};
use crate::resources::{
    DescriptorSetLayout, Fence, Image, ImageView, PipelineDescriptor, PipelineLayout,
    RenderPass, SwapChainDescriptor,
};
use crate::surface::Surface;
use crate::types::{
    BufferDescriptor, DescriptorSetLayoutBinding, Extent2d, ImageDescriptor, ImageType,
    ImageViewDescriptor, MemoryPropertyFlags, PipelineBindPoint, PushConstantRange,
    QueryPoolDescriptor, QueryResultFlags, QueryType, RenderPassDescriptor, SamplerDescriptor,
};

pub(crate) use self::command::record_commands;
pub(crate) use self::instance::VulkanInstance;
pub(crate) use self::pipeline::update_descriptor_set;

/// Maps a failed queue or device call to the matching error.
fn native_error(call: &'static str) -> impl Fn(vk::Result) -> GraphicsError {
    move |e| match e {
        vk::Result::ERROR_DEVICE_LOST => GraphicsError::DeviceLost,
        vk::Result::ERROR_OUT_OF_HOST_MEMORY | vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => {
            GraphicsError::OutOfMemory
        }
        vk::Result::ERROR_OUT_OF_DATE_KHR => GraphicsError::OutOfDate,
        e => GraphicsError::NativeCallFailed {
            call,
            code: e.as_raw() as i64,
        },
    }
}

fn creation_failed(what: &'static str) -> impl Fn(vk::Result) -> GraphicsError {
    move |e| match e {
        vk::Result::ERROR_OUT_OF_HOST_MEMORY | vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => {
            GraphicsError::OutOfMemory
        }
        e => GraphicsError::ResourceCreationFailed(format!("failed to create {what}: {e:?}")),
    }
}

/// The Vulkan device behind a [`GraphicsDevice`](crate::GraphicsDevice).
///
/// Owns the logical device, its queues, the memory allocator and the
/// command pool every primary command buffer is allocated from.
pub(crate) struct VulkanBackend {
    instance: Arc<VulkanInstance>,
    surface: Option<Arc<Surface>>,
    physical_device: vk::PhysicalDevice,
    device: ash::Device,
    graphics_family: u32,
    present_family: u32,
    graphics_queue: vk::Queue,
    present_queue: vk::Queue,
    allocator: ManuallyDrop<Arc<Mutex<Allocator>>>,
    command_pool: Arc<Mutex<vk::CommandPool>>,
    swapchain_loader: ash::khr::swapchain::Device,
    capabilities: BackendCapabilities,
    submissions: SubmissionTracker,
}

/// Device selection for [`VulkanBackend::new`]; unset fields are chosen
/// automatically.
#[derive(Debug, Default)]
pub(crate) struct VulkanDeviceRequest<'a> {
    pub physical_device: Option<vk::PhysicalDevice>,
    pub surface: Option<Arc<Surface>>,
    pub graphics_family: Option<u32>,
    pub present_family: Option<u32>,
    pub extensions: &'a [String],
}

impl VulkanBackend {
    /// Creates the logical device.
    ///
    /// Without an explicit physical device the best one is picked, and
    /// queue families default to the first graphics family and a family
    /// that can present to the surface.
    pub(crate) fn new(
        instance: Arc<VulkanInstance>,
        request: VulkanDeviceRequest<'_>,
    ) -> GraphicsResult<Self> {
        let ash_instance = instance.instance();
        let physical_device = match request.physical_device {
            Some(pd) => pd,
            None => device::select_physical_device(ash_instance)?,
        };

        let (found_graphics, found_present) = device::find_queue_families(
            ash_instance,
            instance.surface_loader(),
            physical_device,
            request.surface.as_ref().map(|s| s.vk_handle()),
        )?;
        let graphics_family = request.graphics_family.unwrap_or(found_graphics);
        let present_family = request.present_family.unwrap_or(found_present);

        let device = device::create_logical_device(
            ash_instance,
            physical_device,
            graphics_family,
            present_family,
            request.extensions,
        )?;
        let graphics_queue = unsafe { device.get_device_queue(graphics_family, 0) };
        let present_queue = unsafe { device.get_device_queue(present_family, 0) };

        let allocator = match allocator::create_allocator(ash_instance, physical_device, device.clone()) {
            Ok(allocator) => allocator,
            Err(e) => {
                unsafe { device.destroy_device(None) };
                return Err(e);
            }
        };
        let command_pool = match command::create_command_pool(&device, graphics_family) {
            Ok(pool) => pool,
            Err(e) => {
                drop(allocator);
                unsafe { device.destroy_device(None) };
                return Err(e);
            }
        };
        let swapchain_loader = ash::khr::swapchain::Device::new(ash_instance, &device);
        let capabilities = device::capabilities(ash_instance, physical_device);

        log::info!(
            "Vulkan backend initialized (graphics family {graphics_family}, present family {present_family}, validation: {})",
            instance.validation()
        );

        Ok(Self {
            instance,
            surface: request.surface,
            physical_device,
            device,
            graphics_family,
            present_family,
            graphics_queue,
            present_queue,
            allocator: ManuallyDrop::new(Arc::new(Mutex::new(allocator))),
            command_pool: Arc::new(Mutex::new(command_pool)),
            swapchain_loader,
            capabilities,
            submissions: SubmissionTracker::new(),
        })
    }

    pub fn capabilities(&self) -> &BackendCapabilities {
        &self.capabilities
    }

    pub fn graphics_family(&self) -> u32 {
        self.graphics_family
    }

    pub fn present_family(&self) -> u32 {
        self.present_family
    }

    // ========================================================================
    // Memory-backed resources
    // ========================================================================

    pub fn create_buffer(&self, descriptor: &BufferDescriptor) -> GraphicsResult<GpuBuffer> {
        let buffer_info = vk::BufferCreateInfo::default()
            .size(descriptor.size)
            .usage(convert_buffer_usage(descriptor.usage))
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe { self.device.create_buffer(&buffer_info, None) }
            .map_err(creation_failed("buffer"))?;
        let requirements = unsafe { self.device.get_buffer_memory_requirements(buffer) };

        let allocation = allocator::allocate(
            &mut self.allocator.lock(),
            descriptor.label.as_deref().unwrap_or("buffer"),
            requirements,
            allocator::memory_location(descriptor.memory_flags),
            true,
        );
        let allocation = match allocation {
            Ok(allocation) => allocation,
            Err(e) => {
                unsafe { self.device.destroy_buffer(buffer, None) };
                return Err(e);
            }
        };

        if let Err(e) = unsafe {
            self.device
                .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
        } {
            unsafe { self.device.destroy_buffer(buffer, None) };
            if let Err(free) = self.allocator.lock().free(allocation) {
                log::error!("Vulkan: failed to free buffer allocation: {free}");
            }
            return Err(GraphicsError::ResourceCreationFailed(format!(
                "failed to bind buffer memory: {e:?}"
            )));
        }

        log::trace!("Vulkan: created buffer {buffer:?} ({} bytes)", descriptor.size);
        Ok(GpuBuffer::Vulkan {
            device: self.device.clone(),
            allocator: Arc::clone(&*self.allocator),
            buffer,
            allocation: Mutex::new(Some(allocation)),
        })
    }

    pub fn create_image(&self, descriptor: &ImageDescriptor) -> GraphicsResult<GpuImage> {
        let extent = descriptor.extent;
        let mut flags = vk::ImageCreateFlags::empty();
        if descriptor.image_type == ImageType::D2
            && descriptor.array_layers % 6 == 0
            && extent.width == extent.height
        {
            flags |= vk::ImageCreateFlags::CUBE_COMPATIBLE;
        }
        let linear = descriptor
            .memory_flags
            .contains(MemoryPropertyFlags::HOST_VISIBLE);
        let tiling = if linear {
            vk::ImageTiling::LINEAR
        } else {
            vk::ImageTiling::OPTIMAL
        };

        let image_info = vk::ImageCreateInfo::default()
            .flags(flags)
            .image_type(convert_image_type(descriptor.image_type))
            .format(convert_format(descriptor.format))
            .extent(convert_extent_3d(extent))
            .mip_levels(descriptor.mip_levels)
            .array_layers(descriptor.array_layers)
            .samples(convert_samples(descriptor.samples))
            .tiling(tiling)
            .usage(convert_image_usage(descriptor.usage))
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let image = unsafe { self.device.create_image(&image_info, None) }
            .map_err(creation_failed("image"))?;
        let requirements = unsafe { self.device.get_image_memory_requirements(image) };

        let allocation = allocator::allocate(
            &mut self.allocator.lock(),
            descriptor.label.as_deref().unwrap_or("image"),
            requirements,
            allocator::memory_location(descriptor.memory_flags),
            linear,
        );
        let allocation = match allocation {
            Ok(allocation) => allocation,
            Err(e) => {
                unsafe { self.device.destroy_image(image, None) };
                return Err(e);
            }
        };

        if let Err(e) = unsafe {
            self.device
                .bind_image_memory(image, allocation.memory(), allocation.offset())
        } {
            unsafe { self.device.destroy_image(image, None) };
            if let Err(free) = self.allocator.lock().free(allocation) {
                log::error!("Vulkan: failed to free image allocation: {free}");
            }
            return Err(GraphicsError::ResourceCreationFailed(format!(
                "failed to bind image memory: {e:?}"
            )));
        }

        log::trace!(
            "Vulkan: created image {image:?} {}x{}x{} {:?}",
            extent.width,
            extent.height,
            extent.depth,
            descriptor.format
        );
        Ok(GpuImage::Vulkan {
            device: self.device.clone(),
            allocator: Arc::clone(&*self.allocator),
            image,
            allocation: Mutex::new(Some(allocation)),
        })
    }

    // ========================================================================
    // Views, samplers and queries
    // ========================================================================

    pub fn create_image_view(
        &self,
        image: &Image,
        descriptor: &ImageViewDescriptor,
    ) -> GraphicsResult<GpuImageView> {
        let (format, range) = ImageView::resolve(image, descriptor);
        let view_info = vk::ImageViewCreateInfo::default()
            .image(image.gpu.vk_handle())
            .view_type(convert_view_type(descriptor.view_type))
            .format(convert_format(format))
            .components(convert_components(&descriptor.components))
            .subresource_range(convert_subresource_range(&range));

        let view = unsafe { self.device.create_image_view(&view_info, None) }
            .map_err(creation_failed("image view"))?;
        Ok(GpuImageView::Vulkan {
            device: self.device.clone(),
            view,
        })
    }

    pub fn create_sampler(&self, descriptor: &SamplerDescriptor) -> GraphicsResult<GpuSampler> {
        let sampler_info = vk::SamplerCreateInfo::default()
            .mag_filter(convert_filter(descriptor.mag_filter))
            .min_filter(convert_filter(descriptor.min_filter))
            .mipmap_mode(convert_mipmap_mode(descriptor.mipmap_mode))
            .address_mode_u(convert_address_mode(descriptor.address_mode_u))
            .address_mode_v(convert_address_mode(descriptor.address_mode_v))
            .address_mode_w(convert_address_mode(descriptor.address_mode_w))
            .mip_lod_bias(descriptor.mip_lod_bias)
            .anisotropy_enable(descriptor.max_anisotropy.is_some())
            .max_anisotropy(descriptor.max_anisotropy.unwrap_or(1.0))
            .compare_enable(descriptor.compare.is_some())
            .compare_op(
                descriptor
                    .compare
                    .map(convert_compare_op)
                    .unwrap_or(vk::CompareOp::ALWAYS),
            )
            .min_lod(descriptor.min_lod)
            .max_lod(descriptor.max_lod)
            .border_color(convert_border_colour(descriptor.border_colour))
            .unnormalized_coordinates(false);

        let sampler = unsafe { self.device.create_sampler(&sampler_info, None) }
            .map_err(creation_failed("sampler"))?;
        Ok(GpuSampler::Vulkan {
            device: self.device.clone(),
            sampler,
        })
    }

    pub fn create_query_pool(
        &self,
        descriptor: &QueryPoolDescriptor,
    ) -> GraphicsResult<GpuQueryPool> {
        // One statistic per query, matching GL_PRIMITIVES_GENERATED on GL.
        let statistics = match descriptor.query_type {
            QueryType::PipelineStatistics => {
                vk::QueryPipelineStatisticFlags::INPUT_ASSEMBLY_PRIMITIVES
            }
            QueryType::Occlusion | QueryType::Timestamp => {
                vk::QueryPipelineStatisticFlags::empty()
            }
        };
        let pool_info = vk::QueryPoolCreateInfo::default()
            .query_type(convert_query_type(descriptor.query_type))
            .query_count(descriptor.query_count)
            .pipeline_statistics(statistics);

        let pool = unsafe { self.device.create_query_pool(&pool_info, None) }
            .map_err(creation_failed("query pool"))?;
        Ok(GpuQueryPool::Vulkan {
            device: self.device.clone(),
            pool,
        })
    }

    // ========================================================================
    // Render passes and framebuffers
    // ========================================================================

    pub fn create_render_pass(
        &self,
        descriptor: &RenderPassDescriptor,
    ) -> GraphicsResult<GpuLayoutObject> {
        let render_pass = pipeline::create_render_pass(&self.device, descriptor)?;
        Ok(GpuLayoutObject::VulkanRenderPass {
            device: self.device.clone(),
            render_pass,
        })
    }

    pub fn create_framebuffer(
        &self,
        render_pass: &RenderPass,
        attachments: &[Arc<ImageView>],
        extent: Extent2d,
        layers: u32,
    ) -> GraphicsResult<GpuFramebuffer> {
        let views: Vec<vk::ImageView> = attachments.iter().map(|v| v.gpu.vk_handle()).collect();
        let framebuffer_info = vk::FramebufferCreateInfo::default()
            .render_pass(render_pass.gpu.vk_render_pass())
            .attachments(&views)
            .width(extent.width)
            .height(extent.height)
            .layers(layers);

        let framebuffer = unsafe { self.device.create_framebuffer(&framebuffer_info, None) }
            .map_err(creation_failed("framebuffer"))?;
        Ok(GpuFramebuffer::Vulkan {
            device: self.device.clone(),
            framebuffer,
        })
    }

    // ========================================================================
    // Layouts, descriptor sets and pipelines
    // ========================================================================

    pub fn create_set_layout(
        &self,
        bindings: &[DescriptorSetLayoutBinding],
    ) -> GraphicsResult<GpuLayoutObject> {
        let layout = pipeline::create_set_layout(&self.device, bindings)?;
        Ok(GpuLayoutObject::VulkanSetLayout {
            device: self.device.clone(),
            layout,
        })
    }

    pub fn create_pipeline_layout(
        &self,
        set_layouts: &[Arc<DescriptorSetLayout>],
        push_constant_ranges: &[PushConstantRange],
    ) -> GraphicsResult<GpuLayoutObject> {
        let handles: Vec<vk::DescriptorSetLayout> = set_layouts
            .iter()
            .map(|layout| layout.gpu.vk_set_layout())
            .collect();
        let layout = pipeline::create_pipeline_layout(&self.device, &handles, push_constant_ranges)?;
        Ok(GpuLayoutObject::VulkanPipelineLayout {
            device: self.device.clone(),
            layout,
        })
    }

    pub fn create_descriptor_set(
        &self,
        layout: &DescriptorSetLayout,
    ) -> GraphicsResult<GpuLayoutObject> {
        let (pool, set) = pipeline::create_descriptor_set(&self.device, layout)?;
        Ok(GpuLayoutObject::VulkanDescriptorSet {
            device: self.device.clone(),
            pool,
            set,
        })
    }

    pub fn create_pipeline(
        &self,
        layout: &PipelineLayout,
        descriptor: &PipelineDescriptor,
    ) -> GraphicsResult<GpuPipeline> {
        let pipeline = match descriptor.bind_point {
            PipelineBindPoint::Graphics => {
                pipeline::create_graphics_pipeline(&self.device, layout, descriptor)?
            }
            PipelineBindPoint::Compute => {
                pipeline::create_compute_pipeline(&self.device, layout, descriptor)?
            }
        };
        log::trace!(
            "Vulkan: created {:?} pipeline {pipeline:?}",
            descriptor.bind_point
        );
        Ok(GpuPipeline::Vulkan {
            device: self.device.clone(),
            pipeline,
        })
    }

    // ========================================================================
    // Synchronisation and command buffers
    // ========================================================================

    pub fn create_fence(&self, signaled: bool) -> GraphicsResult<GpuFence> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        let fence_info = vk::FenceCreateInfo::default().flags(flags);
        let fence = unsafe { self.device.create_fence(&fence_info, None) }
            .map_err(creation_failed("fence"))?;
        Ok(GpuFence::Vulkan {
            device: self.device.clone(),
            fence,
        })
    }

    pub fn create_semaphore(&self) -> GraphicsResult<GpuSemaphore> {
        let semaphore_info = vk::SemaphoreCreateInfo::default();
        let semaphore = unsafe { self.device.create_semaphore(&semaphore_info, None) }
            .map_err(creation_failed("semaphore"))?;
        Ok(GpuSemaphore::Vulkan {
            device: self.device.clone(),
            semaphore,
        })
    }

    /// Allocates a primary command buffer from the device's pool.
    pub fn create_command_buffer(&self) -> GraphicsResult<GpuCommandBuffer> {
        let pool = self.command_pool.lock();
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(*pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let buffers = unsafe { self.device.allocate_command_buffers(&alloc_info) }
            .map_err(creation_failed("command buffer"))?;
        Ok(GpuCommandBuffer::Vulkan {
            device: self.device.clone(),
            pool: Arc::clone(&self.command_pool),
            buffer: buffers[0],
        })
    }

    // ========================================================================
    // Swap chains
    // ========================================================================

    pub fn create_swap_chain(
        &self,
        descriptor: &SwapChainDescriptor,
    ) -> GraphicsResult<(GpuSwapChain, SwapChainDescriptor, Vec<vk::Image>)> {
        let Some(surface) = &self.surface else {
            return Err(GraphicsError::FeatureNotSupported(
                "device was created without a surface".to_string(),
            ));
        };
        let (swapchain, actual, images) = swapchain::create_swapchain(
            &self.instance,
            self.physical_device,
            &self.swapchain_loader,
            surface.vk_handle(),
            swapchain::SwapchainQueues {
                graphics_family: self.graphics_family,
                present_family: self.present_family,
            },
            descriptor,
        )?;
        Ok((
            GpuSwapChain::Vulkan {
                loader: self.swapchain_loader.clone(),
                swapchain,
            },
            actual,
            images,
        ))
    }

    // ========================================================================
    // Submission
    // ========================================================================

    /// Submits the native command buffers of every batch to the graphics
    /// queue in one call.
    ///
    /// The submitted lists are kept until the submission's fence signals.
    /// Returns the number of operations they hold and the submission serial.
    pub fn submit(
        &self,
        batches: &[SubmitBatch<'_>],
        fence: Option<&Fence>,
    ) -> GraphicsResult<Submitted> {
        struct BatchHandles {
            waits: Vec<vk::Semaphore>,
            stages: Vec<vk::PipelineStageFlags>,
            buffers: Vec<vk::CommandBuffer>,
            signals: Vec<vk::Semaphore>,
        }

        let handles: Vec<BatchHandles> = batches
            .iter()
            .map(|batch| BatchHandles {
                waits: batch
                    .info
                    .wait_semaphores
                    .iter()
                    .map(|(semaphore, _)| semaphore.gpu.vk_handle())
                    .collect(),
                stages: batch
                    .info
                    .wait_semaphores
                    .iter()
                    .map(|(_, stages)| convert_pipeline_stages(*stages))
                    .collect(),
                buffers: batch
                    .info
                    .command_buffers
                    .iter()
                    .filter_map(|cmd| match &cmd.gpu {
                        GpuCommandBuffer::Vulkan { buffer, .. } => Some(*buffer),
                        GpuCommandBuffer::Emulated => None,
                    })
                    .collect(),
                signals: batch
                    .info
                    .signal_semaphores
                    .iter()
                    .map(|semaphore| semaphore.gpu.vk_handle())
                    .collect(),
            })
            .collect();
        let submits: Vec<vk::SubmitInfo> = handles
            .iter()
            .map(|h| {
                vk::SubmitInfo::default()
                    .wait_semaphores(&h.waits)
                    .wait_dst_stage_mask(&h.stages)
                    .command_buffers(&h.buffers)
                    .signal_semaphores(&h.signals)
            })
            .collect();

        let tracking = self.acquire_fence()?;
        if let Err(e) = unsafe {
            self.device
                .queue_submit(self.graphics_queue, &submits, tracking)
        } {
            self.submissions.recycle_fence(tracking);
            return Err(native_error("vkQueueSubmit")(e));
        }
        let lists: Vec<Arc<CommandList>> = batches
            .iter()
            .flat_map(|batch| batch.lists.iter().cloned())
            .collect();
        let count = lists.iter().map(|list| operation_count(list)).sum::<u64>();
        let serial = self.submissions.push(tracking, lists);

        // An empty submission signals the client fence once everything
        // submitted before it has finished.
        if let Some(GpuFence::Vulkan { fence, .. }) = fence.map(|f| &f.gpu) {
            unsafe { self.device.queue_submit(self.graphics_queue, &[], *fence) }
                .map_err(native_error("vkQueueSubmit"))?;
        }

        log::trace!(
            "Vulkan: submitted {} batches as submission {serial} ({} in flight)",
            batches.len(),
            self.submissions.in_flight_count()
        );
        Ok(Submitted {
            executed: count,
            in_flight: Some(serial),
        })
    }

    /// A reset fence for the next submission.
    fn acquire_fence(&self) -> GraphicsResult<vk::Fence> {
        if let Some(fence) = self.submissions.take_fence() {
            if let Err(e) = unsafe { self.device.reset_fences(&[fence]) } {
                self.submissions.recycle_fence(fence);
                return Err(native_error("vkResetFences")(e));
            }
            return Ok(fence);
        }
        unsafe {
            self.device
                .create_fence(&vk::FenceCreateInfo::default(), None)
        }
        .map_err(native_error("vkCreateFence"))
    }

    /// Retires finished submissions; returns the newest finished serial.
    pub fn poll_submissions(&self) -> GraphicsResult<u64> {
        if self.submissions.in_flight_count() == 0 {
            return Ok(self.submissions.completed());
        }
        self.submissions
            .retire(|fence| unsafe { self.device.get_fence_status(fence) })
            .map_err(native_error("vkGetFenceStatus"))
    }

    /// Blocks until submission `serial` has finished.
    pub fn wait_for_submission(&self, serial: u64) -> GraphicsResult<()> {
        if let Some(fence) = self.submissions.fence_of(serial) {
            unsafe { self.device.wait_for_fences(&[fence], true, u64::MAX) }
                .map_err(native_error("vkWaitForFences"))?;
        }
        self.poll_submissions().map(|_| ())
    }

    pub fn present(&self, info: &PresentInfo<'_>) -> GraphicsResult<()> {
        let waits: Vec<vk::Semaphore> = info
            .wait_semaphores
            .iter()
            .map(|semaphore| semaphore.gpu.vk_handle())
            .collect();
        let mut swapchains = Vec::with_capacity(info.swap_chains.len());
        let mut indices = Vec::with_capacity(info.swap_chains.len());
        for (swap_chain, index) in &info.swap_chains {
            let GpuSwapChain::Vulkan { swapchain, .. } = &swap_chain.gpu else {
                return Err(GraphicsError::InvalidParameter(
                    "swap chain is not a Vulkan swap chain".to_string(),
                ));
            };
            swapchains.push(*swapchain);
            indices.push(*index);
        }

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&waits)
            .swapchains(&swapchains)
            .image_indices(&indices);
        let suboptimal = unsafe {
            self.swapchain_loader
                .queue_present(self.present_queue, &present_info)
        }
        .map_err(native_error("vkQueuePresentKHR"))?;
        if suboptimal {
            log::trace!("Vulkan: presented to a suboptimal swapchain");
        }
        Ok(())
    }

    pub fn wait_idle(&self) -> GraphicsResult<()> {
        unsafe { self.device.device_wait_idle() }.map_err(native_error("vkDeviceWaitIdle"))?;
        self.submissions.retire_all();
        Ok(())
    }
}

/// Operations in `list`, counting executed secondaries.
fn operation_count(list: &CommandList) -> u64 {
    list.into_iter()
        .map(|operation| match operation {
            Operation::ExecuteCommands { lists } => {
                1 + lists.iter().map(|l| operation_count(l)).sum::<u64>()
            }
            _ => 1,
        })
        .sum()
}

/// Reads query results as 64-bit values.
///
/// With [`QueryResultFlags::WITH_AVAILABILITY`] every query yields its
/// value followed by an availability word. Results that are not ready fail
/// with [`GraphicsError::NotReady`] unless `WAIT` or `PARTIAL` is requested
/// or availability is reported.
pub fn query_results(
    device: &ash::Device,
    pool: vk::QueryPool,
    first: u32,
    count: u32,
    flags: QueryResultFlags,
) -> GraphicsResult<Vec<u64>> {
    let vk_flags = convert_query_result_flags(flags) | vk::QueryResultFlags::TYPE_64;
    let tolerate_not_ready = flags
        .intersects(QueryResultFlags::PARTIAL | QueryResultFlags::WITH_AVAILABILITY);

    let (result, values) = if flags.contains(QueryResultFlags::WITH_AVAILABILITY) {
        let mut data = vec![[0u64; 2]; count as usize];
        let result = unsafe { device.get_query_pool_results(pool, first, &mut data, vk_flags) };
        (result, data.into_iter().flatten().collect())
    } else {
        let mut data = vec![0u64; count as usize];
        let result = unsafe { device.get_query_pool_results(pool, first, &mut data, vk_flags) };
        (result, data)
    };

    match result {
        Ok(()) => Ok(values),
        Err(vk::Result::NOT_READY) if tolerate_not_ready => Ok(values),
        Err(vk::Result::NOT_READY) => Err(GraphicsError::NotReady),
        Err(e) => Err(native_error("vkGetQueryPoolResults")(e)),
    }
}

impl Drop for VulkanBackend {
    fn drop(&mut self) {
        if let Err(e) = unsafe { self.device.device_wait_idle() } {
            log::warn!("Vulkan: wait idle before teardown failed: {e:?}");
        }

        // Retired lists release their resources while the allocator lives.
        for fence in self.submissions.drain_fences() {
            unsafe { self.device.destroy_fence(fence, None) };
        }

        // The allocator must go before the device it allocates from.
        let allocator = unsafe { ManuallyDrop::take(&mut self.allocator) };
        match Arc::try_unwrap(allocator) {
            Ok(allocator) => drop(allocator),
            Err(shared) => {
                log::error!("Vulkan: resources outlive their device, leaking their memory");
                std::mem::forget(shared);
            }
        }

        unsafe {
            self.device
                .destroy_command_pool(*self.command_pool.lock(), None);
            self.device.destroy_device(None);
        }
        log::info!("Vulkan backend destroyed");
    }
}

impl std::fmt::Debug for VulkanBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanBackend")
            .field("physical_device", &self.physical_device)
            .field("graphics_family", &self.graphics_family)
            .field("present_family", &self.present_family)
            .field("surface", &self.surface)
            .field("validation", &self.instance.validation())
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(VulkanBackend: Send, Sync);
