//! Common utilities for integration tests.
//!
//! This module provides shared test infrastructure that can be reused
//! across the different backends.

use std::sync::Arc;

use ashes_graphics::{
    AttachmentDescription, AttachmentReference, BackendType, Buffer, BufferDescriptor,
    BufferUsageFlags, CommandBuffer, CommandBufferLevel, CommandBufferUsageFlags, Connection,
    Extent2d, Format, Framebuffer, GlCall, GraphicsDevice, GraphicsInstance, GraphicsResult,
    HeadlessPlatform, ImageDescriptor, ImageLayout, ImageUsageFlags, ImageViewDescriptor,
    InstanceParameters, MemoryPropertyFlags, RecordingGl, RenderPass, RenderPassDescriptor,
    SubmitInfo, SubpassDescription,
};

/// Generate a deterministic byte pattern of the given length.
#[allow(dead_code)]
pub fn generate_test_pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 256) as u8).collect()
}

// ============================================================================
// Backend Enumeration
// ============================================================================

/// Backends the integration tests run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Counts operations, touches nothing native.
    Test,
    /// GL 3.3 core replay against recorded entry points.
    Gl3,
    /// GL 4.6 replay against recorded entry points.
    Gl4,
    /// Native Vulkan through ash; needs a driver.
    Vulkan,
}

impl Backend {
    /// Check if this backend is currently available.
    pub fn is_available(&self) -> bool {
        match self {
            Backend::Test | Backend::Gl3 | Backend::Gl4 => true,
            // Instance creation still fails cleanly without a driver.
            #[cfg(feature = "vulkan-backend")]
            Backend::Vulkan => true,
            #[cfg(not(feature = "vulkan-backend"))]
            Backend::Vulkan => false,
        }
    }

    /// Get the backend name for display.
    #[allow(dead_code)]
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Test => "test",
            Backend::Gl3 => "gl3",
            Backend::Gl4 => "gl4",
            Backend::Vulkan => "vulkan",
        }
    }

    /// Convert to InstanceParameters for creating a GraphicsInstance.
    pub fn to_instance_parameters(self) -> InstanceParameters {
        let backend = match self {
            Backend::Test => BackendType::Test,
            Backend::Gl3 => BackendType::Gl3,
            Backend::Gl4 => BackendType::Gl4,
            Backend::Vulkan => BackendType::Vulkan,
        };
        InstanceParameters::new()
            .with_backend(backend)
            .with_application_name("ashes-tests")
    }

    /// The `GL_VERSION` string reported by the recorded entry points.
    fn gl_version(self) -> Option<&'static str> {
        match self {
            Backend::Gl3 => Some("3.3.0 core"),
            Backend::Gl4 => Some("4.6.0"),
            Backend::Test | Backend::Vulkan => None,
        }
    }
}

// ============================================================================
// Test Context
// ============================================================================

/// Test context providing access to graphics resources.
///
/// Owns the instance and device of one test and, on GL backends, the
/// recorded entry points so tests can inspect the native calls.
pub struct TestContext {
    /// The backend being tested.
    #[allow(dead_code)]
    pub backend: Backend,
    #[allow(dead_code)]
    instance: Arc<GraphicsInstance>,
    /// Graphics device for creating resources.
    pub device: Arc<GraphicsDevice>,
    /// Recorded GL entry points, on GL backends.
    pub gl: Option<RecordingGl>,
    /// Platform context of a GL device.
    #[allow(dead_code)]
    pub platform: Option<Arc<HeadlessPlatform>>,
}

impl TestContext {
    /// Create a new test context for the given backend.
    ///
    /// Returns `None` if the backend is not available.
    pub fn new(backend: Backend) -> Option<Self> {
        if !backend.is_available() {
            return None;
        }

        let _ = env_logger::builder().is_test(true).try_init();

        let instance = GraphicsInstance::new(backend.to_instance_parameters()).ok()?;
        let (connection, gl, platform) = match backend.gl_version() {
            Some(version) => {
                let gl = RecordingGl::with_version(version);
                let platform = Arc::new(HeadlessPlatform::new());
                let connection = Connection::gl(platform.clone(), Arc::new(gl.clone()));
                (connection, Some(gl), Some(platform))
            }
            None => (Self::native_connection(backend), None, None),
        };
        let device = instance.create_device(connection).ok()?;
        if let Some(gl) = &gl {
            gl.clear_calls();
        }

        Some(Self {
            backend,
            instance,
            device,
            gl,
            platform,
        })
    }

    #[cfg(feature = "vulkan-backend")]
    fn native_connection(backend: Backend) -> Connection {
        match backend {
            Backend::Vulkan => Connection::vulkan(None),
            _ => Connection::headless(),
        }
    }

    #[cfg(not(feature = "vulkan-backend"))]
    fn native_connection(_backend: Backend) -> Connection {
        Connection::headless()
    }

    /// Create a device-local buffer with the given size and usage flags.
    #[allow(dead_code)]
    pub fn create_buffer(&self, size: u64, usage: BufferUsageFlags) -> Arc<Buffer> {
        self.device
            .create_buffer(&BufferDescriptor::new(size, usage))
            .expect("Failed to create buffer")
    }

    /// Create a host-visible buffer usable as copy source and destination.
    #[allow(dead_code)]
    pub fn create_host_buffer(&self, size: u64) -> Arc<Buffer> {
        let descriptor = BufferDescriptor::new(
            size,
            BufferUsageFlags::TRANSFER_SRC | BufferUsageFlags::TRANSFER_DST,
        )
        .with_memory_flags(MemoryPropertyFlags::HOST_VISIBLE | MemoryPropertyFlags::HOST_COHERENT);
        self.device
            .create_buffer(&descriptor)
            .expect("Failed to create host buffer")
    }

    /// Create a command buffer of the given level.
    #[allow(dead_code)]
    pub fn command_buffer(&self, level: CommandBufferLevel) -> CommandBuffer {
        self.device
            .create_command_buffer(level)
            .expect("Failed to create command buffer")
    }

    /// Record a primary command buffer with `record` between begin and end.
    #[allow(dead_code)]
    pub fn record(&self, record: impl FnOnce(&mut CommandBuffer)) -> CommandBuffer {
        let mut cmd = self.command_buffer(CommandBufferLevel::Primary);
        cmd.begin(CommandBufferUsageFlags::empty())
            .expect("Failed to begin command buffer");
        record(&mut cmd);
        cmd.end().expect("Failed to end command buffer");
        cmd
    }

    /// Submit command buffers as one batch on the graphics queue.
    #[allow(dead_code)]
    pub fn submit(&self, command_buffers: &[&CommandBuffer]) -> GraphicsResult<()> {
        self.device
            .graphics_queue()
            .submit(&[SubmitInfo::new(command_buffers)], None)
    }

    /// Submit and block until the device is idle.
    #[allow(dead_code)]
    pub fn submit_and_wait(&self, command_buffers: &[&CommandBuffer]) {
        self.submit(command_buffers).expect("Failed to submit");
        self.device.wait_idle().expect("Failed to wait for the device");
    }

    /// Drain the GL call log; empty on non-GL backends.
    #[allow(dead_code)]
    pub fn take_gl_calls(&self) -> Vec<GlCall> {
        self.gl
            .as_ref()
            .map(RecordingGl::take_calls)
            .unwrap_or_default()
    }

    /// Create a render pass with `count` loaded colour attachments and a
    /// matching framebuffer.
    ///
    /// The attachments keep their contents so beginning the pass clears
    /// nothing by itself.
    #[allow(dead_code)]
    pub fn create_colour_targets(
        &self,
        count: u32,
        width: u32,
        height: u32,
    ) -> (Arc<RenderPass>, Arc<Framebuffer>) {
        let layout = ImageLayout::ColourAttachmentOptimal;
        let attachments = (0..count)
            .map(|_| AttachmentDescription::loaded(Format::Rgba8Unorm, layout))
            .collect();
        let references = (0..count)
            .map(|index| AttachmentReference::new(index, layout))
            .collect();
        let render_pass = self
            .device
            .create_render_pass(&RenderPassDescriptor::new(
                attachments,
                vec![SubpassDescription::new(references)],
            ))
            .expect("Failed to create render pass");

        let views: Vec<_> = (0..count)
            .map(|index| {
                let image = self
                    .device
                    .create_image(
                        &ImageDescriptor::new_2d(
                            width,
                            height,
                            Format::Rgba8Unorm,
                            ImageUsageFlags::COLOR_ATTACHMENT | ImageUsageFlags::TRANSFER_SRC,
                        )
                        .with_label(format!("colour target {index}")),
                    )
                    .expect("Failed to create image");
                self.device
                    .create_image_view(&image, &ImageViewDescriptor::new())
                    .expect("Failed to create image view")
            })
            .collect();
        let framebuffer = self
            .device
            .create_framebuffer(&render_pass, &views, Extent2d::new(width, height), 1)
            .expect("Failed to create framebuffer");
        (render_pass, framebuffer)
    }
}
