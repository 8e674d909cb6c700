//! Backend layer.
//!
//! Every device runs on exactly one backend:
//!
//! - `Vulkan` (feature `vulkan-backend`): forwards recorded command lists to
//!   native Vulkan command buffers through ash
//! - `Gl3` / `Gl4`: replays command lists against a single OpenGL context
//! - `Test`: headless bookkeeping, no native objects
//!
//! Resources carry a per-backend handle enum (`GpuBuffer`, `GpuImage`, ...)
//! whose `Drop` releases the native object.

pub mod gl;
pub mod test;

#[cfg(feature = "vulkan-backend")]
pub mod vulkan;

use std::sync::atomic::{AtomicBool, AtomicU32};
use std::sync::Arc;

#[cfg(feature = "vulkan-backend")]
use ash::vk;
#[cfg(feature = "vulkan-backend")]
use gpu_allocator::vulkan::{Allocation, Allocator};
use parking_lot::Mutex;

use self::gl::constants::{GLenum, GLsync, GLuint};
use self::gl::{GlBackend, GlContext, GlProfile, GlVersion};
use self::test::TestBackend;

/// Backend selection for a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BackendType {
    /// Native Vulkan via ash.
    Vulkan,
    /// OpenGL 3.3 core.
    Gl3,
    /// OpenGL 4.3+ core.
    Gl4,
    /// Headless bookkeeping backend.
    #[default]
    Test,
}

impl BackendType {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Vulkan => "Vulkan",
            Self::Gl3 => "Gl3",
            Self::Gl4 => "Gl4",
            Self::Test => "Test",
        }
    }

    /// Whether the backend emulates Vulkan on an OpenGL context.
    pub fn is_gl(&self) -> bool {
        matches!(self, Self::Gl3 | Self::Gl4)
    }
}

/// Features a backend can or cannot express.
///
/// Recording an operation the backend cannot express is a programming
/// error; clients are expected to check these flags first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BackendCapabilities {
    /// `PipelineBarrier` has an effect (no-op on Gl3).
    pub memory_barriers: bool,
    /// `DrawIndirect` / `DrawIndexedIndirect`.
    pub indirect_draw: bool,
    /// Compute pipelines and `Dispatch*`.
    pub compute: bool,
    /// Non-zero `first_instance` in draws.
    pub base_instance: bool,
    /// Clamped depth bias; otherwise the clamp is ignored.
    pub depth_bias_clamp: bool,
    /// Immutable texture storage.
    pub tex_storage: bool,
    /// Tessellation stages.
    pub tessellation: bool,
    /// Largest image dimension.
    pub max_image_dimension: u32,
    /// Largest buffer size in bytes.
    pub max_buffer_size: u64,
}

impl BackendCapabilities {
    /// Everything supported.
    pub fn full() -> Self {
        Self {
            memory_barriers: true,
            indirect_draw: true,
            compute: true,
            base_instance: true,
            depth_bias_clamp: true,
            tex_storage: true,
            tessellation: true,
            max_image_dimension: 16384,
            max_buffer_size: 1 << 31,
        }
    }

    /// Capabilities of a GL context of the given profile and version.
    pub fn for_gl(profile: GlProfile, version: GlVersion) -> Self {
        let gl4 = profile == GlProfile::Gl4;
        Self {
            memory_barriers: gl4,
            indirect_draw: gl4,
            compute: gl4,
            base_instance: gl4 && version >= GlVersion::new(4, 2),
            depth_bias_clamp: version >= GlVersion::new(4, 6),
            tex_storage: version >= GlVersion::new(4, 2),
            tessellation: gl4,
            max_image_dimension: 16384,
            max_buffer_size: 1 << 31,
        }
    }
}

impl Default for BackendCapabilities {
    fn default() -> Self {
        Self::full()
    }
}

/// The backend instance driving one device.
pub(crate) enum DeviceBackend {
    Test(TestBackend),
    Gl(GlBackend),
    #[cfg(feature = "vulkan-backend")]
    Vulkan(vulkan::VulkanBackend),
}

impl std::fmt::Debug for DeviceBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Test(backend) => f.debug_tuple("Test").field(backend).finish(),
            Self::Gl(backend) => f.debug_tuple("Gl").field(backend).finish(),
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan(backend) => f.debug_tuple("Vulkan").field(backend).finish(),
        }
    }
}

// ============================================================================
// Native handles
// ============================================================================

/// Native buffer object.
pub(crate) enum GpuBuffer {
    /// Host-side shadow memory.
    Test { memory: Mutex<Vec<u8>> },
    Gl {
        context: Arc<GlContext>,
        name: GLuint,
    },
    #[cfg(feature = "vulkan-backend")]
    Vulkan {
        device: ash::Device,
        allocator: Arc<Mutex<Allocator>>,
        buffer: vk::Buffer,
        allocation: Mutex<Option<Allocation>>,
    },
}

impl GpuBuffer {
    /// GL name of the buffer; panics on other backends.
    pub(crate) fn gl_name(&self) -> GLuint {
        match self {
            Self::Gl { name, .. } => *name,
            _ => panic!("buffer is not a GL buffer"),
        }
    }

    #[cfg(feature = "vulkan-backend")]
    pub(crate) fn vk_handle(&self) -> vk::Buffer {
        match self {
            Self::Vulkan { buffer, .. } => *buffer,
            _ => panic!("buffer is not a Vulkan buffer"),
        }
    }
}

impl std::fmt::Debug for GpuBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Test { memory } => f
                .debug_struct("GpuBuffer::Test")
                .field("size", &memory.lock().len())
                .finish(),
            Self::Gl { name, .. } => f
                .debug_struct("GpuBuffer::Gl")
                .field("name", name)
                .finish_non_exhaustive(),
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan { buffer, .. } => f
                .debug_struct("GpuBuffer::Vulkan")
                .field("buffer", buffer)
                .finish_non_exhaustive(),
        }
    }
}

/// Native image object.
pub(crate) enum GpuImage {
    Test,
    Gl {
        context: Arc<GlContext>,
        name: GLuint,
        target: GLenum,
    },
    #[cfg(feature = "vulkan-backend")]
    Vulkan {
        device: ash::Device,
        allocator: Arc<Mutex<Allocator>>,
        image: vk::Image,
        allocation: Mutex<Option<Allocation>>,
    },
    /// Image owned by a Vulkan swapchain; not destroyed with the handle.
    #[cfg(feature = "vulkan-backend")]
    VulkanSwapchain { image: vk::Image },
}

impl GpuImage {
    /// GL name and texture target; panics on other backends.
    pub(crate) fn gl_texture(&self) -> (GLuint, GLenum) {
        match self {
            Self::Gl { name, target, .. } => (*name, *target),
            _ => panic!("image is not a GL texture"),
        }
    }

    #[cfg(feature = "vulkan-backend")]
    pub(crate) fn vk_handle(&self) -> vk::Image {
        match self {
            Self::Vulkan { image, .. } | Self::VulkanSwapchain { image } => *image,
            _ => panic!("image is not a Vulkan image"),
        }
    }
}

impl std::fmt::Debug for GpuImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Test => write!(f, "GpuImage::Test"),
            Self::Gl { name, target, .. } => f
                .debug_struct("GpuImage::Gl")
                .field("name", name)
                .field("target", target)
                .finish_non_exhaustive(),
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan { image, .. } => f
                .debug_struct("GpuImage::Vulkan")
                .field("image", image)
                .finish_non_exhaustive(),
            #[cfg(feature = "vulkan-backend")]
            Self::VulkanSwapchain { image } => f
                .debug_struct("GpuImage::VulkanSwapchain")
                .field("image", image)
                .finish(),
        }
    }
}

/// Native image view. GL views alias the texture of their image.
pub(crate) enum GpuImageView {
    Test,
    Gl,
    #[cfg(feature = "vulkan-backend")]
    Vulkan {
        device: ash::Device,
        view: vk::ImageView,
    },
}

impl GpuImageView {
    #[cfg(feature = "vulkan-backend")]
    pub(crate) fn vk_handle(&self) -> vk::ImageView {
        match self {
            Self::Vulkan { view, .. } => *view,
            _ => panic!("image view is not a Vulkan image view"),
        }
    }
}

impl std::fmt::Debug for GpuImageView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Test => write!(f, "GpuImageView::Test"),
            Self::Gl => write!(f, "GpuImageView::Gl"),
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan { view, .. } => f
                .debug_struct("GpuImageView::Vulkan")
                .field("view", view)
                .finish_non_exhaustive(),
        }
    }
}

/// Native sampler object.
pub(crate) enum GpuSampler {
    Test,
    Gl {
        context: Arc<GlContext>,
        name: GLuint,
    },
    #[cfg(feature = "vulkan-backend")]
    Vulkan {
        device: ash::Device,
        sampler: vk::Sampler,
    },
}

impl GpuSampler {
    pub(crate) fn gl_name(&self) -> GLuint {
        match self {
            Self::Gl { name, .. } => *name,
            _ => panic!("sampler is not a GL sampler"),
        }
    }

    #[cfg(feature = "vulkan-backend")]
    pub(crate) fn vk_handle(&self) -> vk::Sampler {
        match self {
            Self::Vulkan { sampler, .. } => *sampler,
            _ => panic!("sampler is not a Vulkan sampler"),
        }
    }
}

impl std::fmt::Debug for GpuSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Test => write!(f, "GpuSampler::Test"),
            Self::Gl { name, .. } => f
                .debug_struct("GpuSampler::Gl")
                .field("name", name)
                .finish_non_exhaustive(),
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan { sampler, .. } => f
                .debug_struct("GpuSampler::Vulkan")
                .field("sampler", sampler)
                .finish_non_exhaustive(),
        }
    }
}

/// Native query objects.
pub(crate) enum GpuQueryPool {
    Test,
    Gl {
        context: Arc<GlContext>,
        names: Vec<GLuint>,
        target: GLenum,
    },
    #[cfg(feature = "vulkan-backend")]
    Vulkan {
        device: ash::Device,
        pool: vk::QueryPool,
    },
}

impl GpuQueryPool {
    #[cfg(feature = "vulkan-backend")]
    pub(crate) fn vk_handle(&self) -> vk::QueryPool {
        match self {
            Self::Vulkan { pool, .. } => *pool,
            _ => panic!("query pool is not a Vulkan query pool"),
        }
    }
}

impl std::fmt::Debug for GpuQueryPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Test => write!(f, "GpuQueryPool::Test"),
            Self::Gl { names, target, .. } => f
                .debug_struct("GpuQueryPool::Gl")
                .field("names", names)
                .field("target", target)
                .finish_non_exhaustive(),
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan { pool, .. } => f
                .debug_struct("GpuQueryPool::Vulkan")
                .field("pool", pool)
                .finish_non_exhaustive(),
        }
    }
}

/// Native framebuffer object.
pub(crate) enum GpuFramebuffer {
    Test,
    Gl {
        context: Arc<GlContext>,
        fbo: GLuint,
    },
    #[cfg(feature = "vulkan-backend")]
    Vulkan {
        device: ash::Device,
        framebuffer: vk::Framebuffer,
    },
}

impl GpuFramebuffer {
    pub(crate) fn gl_name(&self) -> GLuint {
        match self {
            Self::Gl { fbo, .. } => *fbo,
            _ => panic!("framebuffer is not a GL framebuffer"),
        }
    }

    #[cfg(feature = "vulkan-backend")]
    pub(crate) fn vk_handle(&self) -> vk::Framebuffer {
        match self {
            Self::Vulkan { framebuffer, .. } => *framebuffer,
            _ => panic!("framebuffer is not a Vulkan framebuffer"),
        }
    }
}

impl std::fmt::Debug for GpuFramebuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Test => write!(f, "GpuFramebuffer::Test"),
            Self::Gl { fbo, .. } => f
                .debug_struct("GpuFramebuffer::Gl")
                .field("fbo", fbo)
                .finish_non_exhaustive(),
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan { framebuffer, .. } => f
                .debug_struct("GpuFramebuffer::Vulkan")
                .field("framebuffer", framebuffer)
                .finish_non_exhaustive(),
        }
    }
}

/// Native object for a resource GL and Test only describe.
///
/// Render passes, descriptor set layouts and pipeline layouts have no GL
/// counterpart; only Vulkan creates a handle for them.
pub(crate) enum GpuLayoutObject {
    Emulated,
    #[cfg(feature = "vulkan-backend")]
    VulkanRenderPass {
        device: ash::Device,
        render_pass: vk::RenderPass,
    },
    #[cfg(feature = "vulkan-backend")]
    VulkanSetLayout {
        device: ash::Device,
        layout: vk::DescriptorSetLayout,
    },
    #[cfg(feature = "vulkan-backend")]
    VulkanPipelineLayout {
        device: ash::Device,
        layout: vk::PipelineLayout,
    },
    #[cfg(feature = "vulkan-backend")]
    VulkanDescriptorSet {
        device: ash::Device,
        pool: vk::DescriptorPool,
        set: vk::DescriptorSet,
    },
}

impl GpuLayoutObject {
    #[cfg(feature = "vulkan-backend")]
    pub(crate) fn vk_render_pass(&self) -> vk::RenderPass {
        match self {
            Self::VulkanRenderPass { render_pass, .. } => *render_pass,
            _ => panic!("object is not a Vulkan render pass"),
        }
    }

    #[cfg(feature = "vulkan-backend")]
    pub(crate) fn vk_set_layout(&self) -> vk::DescriptorSetLayout {
        match self {
            Self::VulkanSetLayout { layout, .. } => *layout,
            _ => panic!("object is not a Vulkan descriptor set layout"),
        }
    }

    #[cfg(feature = "vulkan-backend")]
    pub(crate) fn vk_pipeline_layout(&self) -> vk::PipelineLayout {
        match self {
            Self::VulkanPipelineLayout { layout, .. } => *layout,
            _ => panic!("object is not a Vulkan pipeline layout"),
        }
    }

    #[cfg(feature = "vulkan-backend")]
    pub(crate) fn vk_descriptor_set(&self) -> vk::DescriptorSet {
        match self {
            Self::VulkanDescriptorSet { set, .. } => *set,
            _ => panic!("object is not a Vulkan descriptor set"),
        }
    }
}

impl std::fmt::Debug for GpuLayoutObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Emulated => write!(f, "GpuLayoutObject::Emulated"),
            #[cfg(feature = "vulkan-backend")]
            Self::VulkanRenderPass { render_pass, .. } => f
                .debug_tuple("GpuLayoutObject::VulkanRenderPass")
                .field(render_pass)
                .finish(),
            #[cfg(feature = "vulkan-backend")]
            Self::VulkanSetLayout { layout, .. } => f
                .debug_tuple("GpuLayoutObject::VulkanSetLayout")
                .field(layout)
                .finish(),
            #[cfg(feature = "vulkan-backend")]
            Self::VulkanPipelineLayout { layout, .. } => f
                .debug_tuple("GpuLayoutObject::VulkanPipelineLayout")
                .field(layout)
                .finish(),
            #[cfg(feature = "vulkan-backend")]
            Self::VulkanDescriptorSet { set, .. } => f
                .debug_tuple("GpuLayoutObject::VulkanDescriptorSet")
                .field(set)
                .finish(),
        }
    }
}

/// Native pipeline object.
pub(crate) enum GpuPipeline {
    Test,
    Gl {
        context: Arc<GlContext>,
        program: GLuint,
    },
    #[cfg(feature = "vulkan-backend")]
    Vulkan {
        device: ash::Device,
        pipeline: vk::Pipeline,
    },
}

impl GpuPipeline {
    pub(crate) fn gl_program(&self) -> GLuint {
        match self {
            Self::Gl { program, .. } => *program,
            _ => panic!("pipeline is not a GL program"),
        }
    }

    #[cfg(feature = "vulkan-backend")]
    pub(crate) fn vk_handle(&self) -> vk::Pipeline {
        match self {
            Self::Vulkan { pipeline, .. } => *pipeline,
            _ => panic!("pipeline is not a Vulkan pipeline"),
        }
    }
}

impl std::fmt::Debug for GpuPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Test => write!(f, "GpuPipeline::Test"),
            Self::Gl { program, .. } => f
                .debug_struct("GpuPipeline::Gl")
                .field("program", program)
                .finish_non_exhaustive(),
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan { pipeline, .. } => f
                .debug_struct("GpuPipeline::Vulkan")
                .field("pipeline", pipeline)
                .finish_non_exhaustive(),
        }
    }
}

/// Native fence.
pub(crate) enum GpuFence {
    Test {
        signaled: AtomicBool,
    },
    Gl {
        context: Arc<GlContext>,
        sync: Mutex<Option<GLsync>>,
        signaled: AtomicBool,
    },
    #[cfg(feature = "vulkan-backend")]
    Vulkan {
        device: ash::Device,
        fence: vk::Fence,
    },
}

impl std::fmt::Debug for GpuFence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Test { signaled } => f
                .debug_struct("GpuFence::Test")
                .field("signaled", signaled)
                .finish(),
            Self::Gl { sync, signaled, .. } => f
                .debug_struct("GpuFence::Gl")
                .field("sync", &*sync.lock())
                .field("signaled", signaled)
                .finish_non_exhaustive(),
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan { fence, .. } => f
                .debug_struct("GpuFence::Vulkan")
                .field("fence", fence)
                .finish_non_exhaustive(),
        }
    }
}

/// Native semaphore. GL and Test only track a signaled flag.
pub(crate) enum GpuSemaphore {
    Emulated {
        signaled: AtomicBool,
    },
    #[cfg(feature = "vulkan-backend")]
    Vulkan {
        device: ash::Device,
        semaphore: vk::Semaphore,
    },
}

impl GpuSemaphore {
    #[cfg(feature = "vulkan-backend")]
    pub(crate) fn vk_handle(&self) -> vk::Semaphore {
        match self {
            Self::Vulkan { semaphore, .. } => *semaphore,
            _ => panic!("semaphore is not a Vulkan semaphore"),
        }
    }
}

impl std::fmt::Debug for GpuSemaphore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Emulated { signaled } => f
                .debug_struct("GpuSemaphore::Emulated")
                .field("signaled", signaled)
                .finish(),
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan { semaphore, .. } => f
                .debug_struct("GpuSemaphore::Vulkan")
                .field("semaphore", semaphore)
                .finish_non_exhaustive(),
        }
    }
}

/// Native command buffer. Only Vulkan records into a driver object.
pub(crate) enum GpuCommandBuffer {
    Emulated,
    #[cfg(feature = "vulkan-backend")]
    Vulkan {
        device: ash::Device,
        pool: Arc<Mutex<vk::CommandPool>>,
        buffer: vk::CommandBuffer,
    },
}

impl std::fmt::Debug for GpuCommandBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Emulated => write!(f, "GpuCommandBuffer::Emulated"),
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan { buffer, .. } => f
                .debug_struct("GpuCommandBuffer::Vulkan")
                .field("buffer", buffer)
                .finish_non_exhaustive(),
        }
    }
}

/// Native swap chain. GL and Test cycle through host-side images.
pub(crate) enum GpuSwapChain {
    Emulated {
        next: AtomicU32,
    },
    #[cfg(feature = "vulkan-backend")]
    Vulkan {
        loader: ash::khr::swapchain::Device,
        swapchain: vk::SwapchainKHR,
    },
}

impl std::fmt::Debug for GpuSwapChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Emulated { next } => f
                .debug_struct("GpuSwapChain::Emulated")
                .field("next", next)
                .finish(),
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan { swapchain, .. } => f
                .debug_struct("GpuSwapChain::Vulkan")
                .field("swapchain", swapchain)
                .finish_non_exhaustive(),
        }
    }
}

// ============================================================================
// Native cleanup (Drop implementations)
// ============================================================================

/// Runs `delete` with the context current, skipping lost contexts.
fn gl_release(context: &GlContext, what: &str, delete: impl FnOnce(&dyn gl::GlApi)) {
    match context.lock() {
        Ok(lock) => delete(lock.gl()),
        Err(err) => log::warn!("GL: leaking {what} on unusable context: {err}"),
    }
}

impl Drop for GpuBuffer {
    fn drop(&mut self) {
        match self {
            Self::Test { .. } => {}
            Self::Gl { context, name } => {
                gl_release(context, "buffer", |gl| gl.delete_buffer(*name));
            }
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan {
                device,
                allocator,
                buffer,
                allocation,
            } => {
                if let Some(allocation) = allocation.lock().take() {
                    if let Err(e) = allocator.lock().free(allocation) {
                        log::error!("Failed to free buffer allocation: {}", e);
                    }
                }
                unsafe { device.destroy_buffer(*buffer, None) };
            }
        }
    }
}

impl Drop for GpuImage {
    fn drop(&mut self) {
        match self {
            Self::Test => {}
            Self::Gl { context, name, .. } => {
                gl_release(context, "texture", |gl| gl.delete_texture(*name));
            }
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan {
                device,
                allocator,
                image,
                allocation,
            } => {
                if let Some(allocation) = allocation.lock().take() {
                    if let Err(e) = allocator.lock().free(allocation) {
                        log::error!("Failed to free image allocation: {}", e);
                    }
                }
                unsafe { device.destroy_image(*image, None) };
            }
            #[cfg(feature = "vulkan-backend")]
            Self::VulkanSwapchain { .. } => {}
        }
    }
}

#[cfg(feature = "vulkan-backend")]
impl Drop for GpuImageView {
    fn drop(&mut self) {
        if let Self::Vulkan { device, view } = self {
            unsafe { device.destroy_image_view(*view, None) };
        }
    }
}

impl Drop for GpuSampler {
    fn drop(&mut self) {
        match self {
            Self::Test => {}
            Self::Gl { context, name } => {
                gl_release(context, "sampler", |gl| gl.delete_sampler(*name));
            }
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan { device, sampler } => unsafe { device.destroy_sampler(*sampler, None) },
        }
    }
}

impl Drop for GpuQueryPool {
    fn drop(&mut self) {
        match self {
            Self::Test => {}
            Self::Gl { context, names, .. } => {
                gl_release(context, "queries", |gl| {
                    for name in names.iter() {
                        gl.delete_query(*name);
                    }
                });
            }
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan { device, pool } => unsafe { device.destroy_query_pool(*pool, None) },
        }
    }
}

impl Drop for GpuFramebuffer {
    fn drop(&mut self) {
        match self {
            Self::Test => {}
            Self::Gl { context, fbo } => {
                gl_release(context, "framebuffer", |gl| gl.delete_framebuffer(*fbo));
            }
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan {
                device,
                framebuffer,
            } => unsafe { device.destroy_framebuffer(*framebuffer, None) },
        }
    }
}

#[cfg(feature = "vulkan-backend")]
impl Drop for GpuLayoutObject {
    fn drop(&mut self) {
        unsafe {
            match self {
                Self::Emulated => {}
                Self::VulkanRenderPass {
                    device,
                    render_pass,
                } => device.destroy_render_pass(*render_pass, None),
                Self::VulkanSetLayout { device, layout } => {
                    device.destroy_descriptor_set_layout(*layout, None)
                }
                Self::VulkanPipelineLayout { device, layout } => {
                    device.destroy_pipeline_layout(*layout, None)
                }
                // Destroying the pool frees the set.
                Self::VulkanDescriptorSet { device, pool, .. } => {
                    device.destroy_descriptor_pool(*pool, None)
                }
            }
        }
    }
}

impl Drop for GpuPipeline {
    fn drop(&mut self) {
        match self {
            Self::Test => {}
            Self::Gl { context, program } => {
                gl_release(context, "program", |gl| gl.delete_program(*program));
            }
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan { device, pipeline } => unsafe {
                device.destroy_pipeline(*pipeline, None)
            },
        }
    }
}

impl Drop for GpuFence {
    fn drop(&mut self) {
        match self {
            Self::Test { .. } => {}
            Self::Gl { context, sync, .. } => {
                if let Some(sync) = sync.lock().take() {
                    gl_release(context, "sync object", |gl| gl.delete_sync(sync));
                }
            }
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan { device, fence } => unsafe { device.destroy_fence(*fence, None) },
        }
    }
}

#[cfg(feature = "vulkan-backend")]
impl Drop for GpuSemaphore {
    fn drop(&mut self) {
        if let Self::Vulkan { device, semaphore } = self {
            unsafe { device.destroy_semaphore(*semaphore, None) };
        }
    }
}

#[cfg(feature = "vulkan-backend")]
impl Drop for GpuCommandBuffer {
    fn drop(&mut self) {
        if let Self::Vulkan {
            device,
            pool,
            buffer,
        } = self
        {
            let pool = pool.lock();
            unsafe { device.free_command_buffers(*pool, &[*buffer]) };
        }
    }
}

#[cfg(feature = "vulkan-backend")]
impl Drop for GpuSwapChain {
    fn drop(&mut self) {
        if let Self::Vulkan { loader, swapchain } = self {
            unsafe { loader.destroy_swapchain(*swapchain, None) };
        }
    }
}
