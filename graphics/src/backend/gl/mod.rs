//! OpenGL 3.x / 4.x backends.
//!
//! A GL device owns exactly one [`GlContext`]. Resources are created eagerly
//! with the context current; command lists are replayed against it at
//! submission time by [`replay::ReplayState`]. Semaphores are host flags,
//! fences wrap GL sync objects.

mod api;
pub mod constants;
mod context;
pub mod conversion;
#[cfg(feature = "gl-native")]
mod native;
mod recording;
mod replay;

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

pub use api::{check_errors, error_name, GlApi};
pub use context::{ContextId, ContextLock, ContextRegistry, GlContext, GlVersion, PlatformContext};
#[cfg(feature = "gl-native")]
pub use native::GlowApi;
pub use recording::{GlCall, HeadlessPlatform, RecordingGl};

use self::constants::*;
use self::conversion::*;
use self::replay::ReplayState;
use super::{
    BackendCapabilities, GpuBuffer, GpuFence, GpuFramebuffer, GpuImage, GpuImageView,
    GpuPipeline, GpuQueryPool, GpuSampler,
};
use crate::command::{PresentInfo, SubmitBatch};
use crate::error::{GraphicsError, GraphicsResult};
use crate::resources::{Fence, Image, ImageView, PipelineDescriptor, RenderPass};
use crate::types::{
    BufferDescriptor, ImageDescriptor, ImageType, ImageViewDescriptor, QueryPoolDescriptor,
    QueryResultFlags, SamplerDescriptor, ShaderSource, ShaderStageFlags, VertexInputState,
    WaitResult,
};

/// Flavour of GL context a device runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlProfile {
    /// OpenGL 3.3 core: no compute, no indirect draws, no memory barriers.
    Gl3,
    /// OpenGL 4.3+ core.
    Gl4,
}

impl GlProfile {
    /// Oldest context version the profile accepts.
    pub fn min_version(&self) -> GlVersion {
        match self {
            Self::Gl3 => GlVersion::new(3, 3),
            Self::Gl4 => GlVersion::new(4, 3),
        }
    }
}

/// Maps the GL error queue after a creation call to a [`GraphicsError`].
fn check_creation(lock: &ContextLock<'_>, call: &'static str) -> GraphicsResult<()> {
    match check_errors(lock.gl(), call) {
        GL_NO_ERROR => Ok(()),
        GL_CONTEXT_LOST => {
            lock.context().mark_lost();
            Err(GraphicsError::DeviceLost)
        }
        GL_OUT_OF_MEMORY => Err(GraphicsError::OutOfMemory),
        code => Err(GraphicsError::NativeCallFailed {
            call,
            code: i64::from(code),
        }),
    }
}

/// Fails with [`GraphicsError::DeviceLost`] once the context reports loss.
///
/// Other GL errors are only logged.
fn check_lost(lock: &ContextLock<'_>, call: &str) -> GraphicsResult<()> {
    if check_errors(lock.gl(), call) == GL_CONTEXT_LOST || lock.context().is_lost() {
        lock.context().mark_lost();
        return Err(GraphicsError::DeviceLost);
    }
    Ok(())
}

/// Attaches one level (and layer, for layered targets) of a texture.
fn attach_texture(
    gl: &dyn GlApi,
    framebuffer_target: GLenum,
    attachment: GLenum,
    image: &Image,
    level: u32,
    layer: u32,
) {
    let (name, target) = image.gpu.gl_texture();
    match target {
        GL_TEXTURE_2D_ARRAY | GL_TEXTURE_3D | GL_TEXTURE_CUBE_MAP_ARRAY => gl
            .framebuffer_texture_layer(
                framebuffer_target,
                attachment,
                name,
                level as GLint,
                layer as GLint,
            ),
        _ => gl.framebuffer_texture_2d(framebuffer_target, attachment, target, name, level as GLint),
    }
}

/// State of a GL3 / GL4 device.
pub(crate) struct GlBackend {
    context: Arc<GlContext>,
    profile: GlProfile,
    version: GlVersion,
    capabilities: BackendCapabilities,
    validation: bool,
    /// Vertex array object every draw goes through.
    vao: GLuint,
    /// Attribute locations currently enabled on `vao`.
    enabled_attributes: Mutex<BTreeSet<GLuint>>,
    /// Scratch framebuffers for copies, image clears and presentation.
    read_fbo: GLuint,
    draw_fbo: GLuint,
}

impl GlBackend {
    /// Checks the context version and creates the device-wide GL objects.
    pub(crate) fn new(
        context: Arc<GlContext>,
        profile: GlProfile,
        validation: bool,
    ) -> GraphicsResult<Self> {
        let version = context.version()?;
        if version < profile.min_version() {
            return Err(GraphicsError::InitializationFailed(format!(
                "{profile:?} needs GL {} or newer, context is {version}",
                profile.min_version()
            )));
        }
        let capabilities = BackendCapabilities::for_gl(profile, version);

        let (vao, read_fbo, draw_fbo) = {
            let lock = context.lock()?;
            let gl = lock.gl();
            let vao = gl.gen_vertex_array();
            gl.bind_vertex_array(vao);
            let read_fbo = gl.gen_framebuffer();
            let draw_fbo = gl.gen_framebuffer();
            check_creation(&lock, "GlBackend::new")?;
            (vao, read_fbo, draw_fbo)
        };

        log::info!("{profile:?} backend initialized on GL {version} (validation: {validation})");
        Ok(Self {
            context,
            profile,
            version,
            capabilities,
            validation,
            vao,
            enabled_attributes: Mutex::new(BTreeSet::new()),
            read_fbo,
            draw_fbo,
        })
    }

    pub(crate) fn context(&self) -> &Arc<GlContext> {
        &self.context
    }

    pub(crate) fn profile(&self) -> GlProfile {
        self.profile
    }

    pub(crate) fn version(&self) -> GlVersion {
        self.version
    }

    pub(crate) fn capabilities(&self) -> &BackendCapabilities {
        &self.capabilities
    }

    // ========================================================================
    // Resource creation
    // ========================================================================

    pub(crate) fn create_buffer(&self, descriptor: &BufferDescriptor) -> GraphicsResult<GpuBuffer> {
        if descriptor.size > self.capabilities.max_buffer_size {
            return Err(GraphicsError::InvalidParameter(format!(
                "buffer size {} exceeds the {} byte limit",
                descriptor.size, self.capabilities.max_buffer_size
            )));
        }
        let lock = self.context.lock()?;
        let gl = lock.gl();
        let name = gl.gen_buffer();
        gl.bind_buffer(GL_COPY_WRITE_BUFFER, name);
        gl.buffer_data_size(
            GL_COPY_WRITE_BUFFER,
            descriptor.size as GLsizeiptr,
            convert_memory_flags(descriptor.memory_flags),
        );
        gl.bind_buffer(GL_COPY_WRITE_BUFFER, 0);
        if let Err(e) = check_creation(&lock, "glBufferData") {
            gl.delete_buffer(name);
            return Err(e);
        }
        log::trace!("GL: created buffer {name} ({} bytes)", descriptor.size);
        Ok(GpuBuffer::Gl {
            context: self.context.clone(),
            name,
        })
    }

    pub(crate) fn create_image(&self, descriptor: &ImageDescriptor) -> GraphicsResult<GpuImage> {
        let extent = descriptor.extent;
        let max = self.capabilities.max_image_dimension;
        if extent.width > max || extent.height > max || extent.depth > max {
            return Err(GraphicsError::InvalidParameter(format!(
                "image extent {extent:?} exceeds {max}"
            )));
        }
        let multisampled = descriptor.samples.count() > 1;
        let target = match descriptor.image_type {
            ImageType::D1 => {
                return Err(GraphicsError::FeatureNotSupported(
                    "1D images are not supported by the GL backends".to_string(),
                ))
            }
            ImageType::D2 if multisampled && descriptor.array_layers > 1 => {
                return Err(GraphicsError::FeatureNotSupported(
                    "multisampled array images are not supported by the GL backends".to_string(),
                ))
            }
            ImageType::D2 if multisampled => GL_TEXTURE_2D_MULTISAMPLE,
            ImageType::D2 if descriptor.array_layers > 1 => GL_TEXTURE_2D_ARRAY,
            ImageType::D2 => GL_TEXTURE_2D,
            ImageType::D3 => GL_TEXTURE_3D,
        };
        let format = convert_format(descriptor.format);
        let (width, height) = (extent.width as GLsizei, extent.height as GLsizei);
        let depth = if target == GL_TEXTURE_3D {
            extent.depth as GLsizei
        } else {
            descriptor.array_layers as GLsizei
        };
        let levels = descriptor.mip_levels.max(1);

        let lock = self.context.lock()?;
        let gl = lock.gl();
        let name = gl.gen_texture();
        gl.bind_texture(target, name);
        match target {
            GL_TEXTURE_2D_MULTISAMPLE => gl.tex_image_2d_multisample(
                target,
                descriptor.samples.count() as GLsizei,
                format.internal,
                width,
                height,
            ),
            GL_TEXTURE_2D if self.capabilities.tex_storage => {
                gl.tex_storage_2d(target, levels as GLsizei, format.internal, width, height)
            }
            _ if self.capabilities.tex_storage => gl.tex_storage_3d(
                target,
                levels as GLsizei,
                format.internal,
                width,
                height,
                depth,
            ),
            _ => {
                for level in 0..levels {
                    let size = extent.mip_level(level);
                    if target == GL_TEXTURE_2D {
                        gl.tex_image_2d(
                            target,
                            level as GLint,
                            format.internal,
                            size.width as GLsizei,
                            size.height as GLsizei,
                            format.format,
                            format.ty,
                        );
                    } else {
                        // Array layers do not shrink with the mip level.
                        let level_depth = if target == GL_TEXTURE_3D {
                            size.depth as GLsizei
                        } else {
                            depth
                        };
                        gl.tex_image_3d(
                            target,
                            level as GLint,
                            format.internal,
                            size.width as GLsizei,
                            size.height as GLsizei,
                            level_depth,
                            format.format,
                            format.ty,
                        );
                    }
                }
                gl.tex_parameter_i(target, GL_TEXTURE_MAX_LEVEL, levels as GLint - 1);
            }
        }
        gl.bind_texture(target, 0);
        if let Err(e) = check_creation(&lock, "texture storage") {
            gl.delete_texture(name);
            return Err(e);
        }
        log::trace!(
            "GL: created texture {name} ({:?}, {}x{}x{depth}, {levels} levels)",
            descriptor.format,
            width,
            height
        );
        Ok(GpuImage::Gl {
            context: self.context.clone(),
            name,
            target,
        })
    }

    /// GL views alias their image's texture; only the swizzle is applied,
    /// to the texture itself.
    pub(crate) fn create_image_view(
        &self,
        image: &Image,
        descriptor: &ImageViewDescriptor,
    ) -> GraphicsResult<GpuImageView> {
        let components = descriptor.components;
        if components == Default::default() {
            return Ok(GpuImageView::Gl);
        }
        let (name, target) = image.gpu.gl_texture();
        let lock = self.context.lock()?;
        let gl = lock.gl();
        gl.bind_texture(target, name);
        for (pname, swizzle, own) in [
            (GL_TEXTURE_SWIZZLE_R, components.r, GL_RED),
            (GL_TEXTURE_SWIZZLE_G, components.g, GL_GREEN),
            (GL_TEXTURE_SWIZZLE_B, components.b, GL_BLUE),
            (GL_TEXTURE_SWIZZLE_A, components.a, GL_ALPHA),
        ] {
            gl.tex_parameter_i(target, pname, convert_swizzle(swizzle, own) as GLint);
        }
        gl.bind_texture(target, 0);
        check_creation(&lock, "texture swizzle")?;
        Ok(GpuImageView::Gl)
    }

    pub(crate) fn create_sampler(&self, descriptor: &SamplerDescriptor) -> GraphicsResult<GpuSampler> {
        let lock = self.context.lock()?;
        let gl = lock.gl();
        let name = gl.gen_sampler();
        let int = |pname, value: GLenum| gl.sampler_parameter_i(name, pname, value as GLint);
        int(GL_TEXTURE_MAG_FILTER, convert_mag_filter(descriptor.mag_filter));
        int(
            GL_TEXTURE_MIN_FILTER,
            convert_min_filter(descriptor.min_filter, descriptor.mipmap_mode),
        );
        int(GL_TEXTURE_WRAP_S, convert_address_mode(descriptor.address_mode_u));
        int(GL_TEXTURE_WRAP_T, convert_address_mode(descriptor.address_mode_v));
        int(GL_TEXTURE_WRAP_R, convert_address_mode(descriptor.address_mode_w));
        gl.sampler_parameter_f(name, GL_TEXTURE_MIN_LOD, descriptor.min_lod);
        gl.sampler_parameter_f(name, GL_TEXTURE_MAX_LOD, descriptor.max_lod);
        gl.sampler_parameter_f(name, GL_TEXTURE_LOD_BIAS, descriptor.mip_lod_bias);
        if let Some(anisotropy) = descriptor.max_anisotropy {
            gl.sampler_parameter_f(name, GL_TEXTURE_MAX_ANISOTROPY, anisotropy);
        }
        if let Some(compare) = descriptor.compare {
            int(GL_TEXTURE_COMPARE_MODE, GL_COMPARE_REF_TO_TEXTURE);
            int(GL_TEXTURE_COMPARE_FUNC, convert_compare_op(compare));
        }
        gl.sampler_parameter_fv(name, GL_TEXTURE_BORDER_COLOR, &descriptor.border_colour.rgba());
        if let Err(e) = check_creation(&lock, "glSamplerParameter") {
            gl.delete_sampler(name);
            return Err(e);
        }
        log::trace!("GL: created sampler {name}");
        Ok(GpuSampler::Gl {
            context: self.context.clone(),
            name,
        })
    }

    pub(crate) fn create_query_pool(
        &self,
        descriptor: &QueryPoolDescriptor,
    ) -> GraphicsResult<GpuQueryPool> {
        let lock = self.context.lock()?;
        let gl = lock.gl();
        let names = (0..descriptor.query_count).map(|_| gl.gen_query()).collect();
        check_creation(&lock, "glGenQueries")?;
        Ok(GpuQueryPool::Gl {
            context: self.context.clone(),
            names,
            target: convert_query_type(descriptor.query_type),
        })
    }

    /// Attachment `i` of the render pass lands on `GL_COLOR_ATTACHMENT0 + i`
    /// (or the depth/stencil point); subpasses select theirs with
    /// `glDrawBuffers`.
    pub(crate) fn create_framebuffer(
        &self,
        render_pass: &RenderPass,
        attachments: &[Arc<ImageView>],
    ) -> GraphicsResult<GpuFramebuffer> {
        let lock = self.context.lock()?;
        let gl = lock.gl();
        let fbo = gl.gen_framebuffer();
        gl.bind_framebuffer(GL_DRAW_FRAMEBUFFER, fbo);
        for (index, (view, description)) in attachments
            .iter()
            .zip(render_pass.attachments())
            .enumerate()
        {
            let point = if description.format.is_depth_or_stencil() {
                depth_stencil_attachment_point(description.format)
            } else {
                GL_COLOR_ATTACHMENT0 + index as GLenum
            };
            let range = view.subresource_range();
            attach_texture(
                gl,
                GL_DRAW_FRAMEBUFFER,
                point,
                view.image(),
                range.base_mip_level,
                range.base_array_layer,
            );
        }
        let status = gl.check_framebuffer_status(GL_DRAW_FRAMEBUFFER);
        gl.bind_framebuffer(GL_DRAW_FRAMEBUFFER, 0);
        if status != GL_FRAMEBUFFER_COMPLETE {
            gl.delete_framebuffer(fbo);
            return Err(GraphicsError::ResourceCreationFailed(format!(
                "framebuffer incomplete (status {status:#x})"
            )));
        }
        if let Err(e) = check_creation(&lock, "glFramebufferTexture") {
            gl.delete_framebuffer(fbo);
            return Err(e);
        }
        log::trace!("GL: created framebuffer {fbo} ({} attachments)", attachments.len());
        Ok(GpuFramebuffer::Gl {
            context: self.context.clone(),
            fbo,
        })
    }

    /// Compiles and links the GLSL stages of a pipeline into one program.
    pub(crate) fn create_pipeline(&self, descriptor: &PipelineDescriptor) -> GraphicsResult<GpuPipeline> {
        for stage in &descriptor.stages {
            if stage.stage == ShaderStageFlags::COMPUTE && !self.capabilities.compute {
                return Err(GraphicsError::FeatureNotSupported(format!(
                    "compute shaders need GL 4.3, context is {}",
                    self.version
                )));
            }
            if stage.stage.intersects(
                ShaderStageFlags::TESSELLATION_CONTROL | ShaderStageFlags::TESSELLATION_EVALUATION,
            ) && !self.capabilities.tessellation
            {
                return Err(GraphicsError::FeatureNotSupported(format!(
                    "tessellation needs GL 4, context is {}",
                    self.version
                )));
            }
            if let ShaderSource::SpirV(_) = stage.source {
                return Err(GraphicsError::FeatureNotSupported(
                    "the GL backends consume GLSL sources only".to_string(),
                ));
            }
        }

        if self.validation {
            validate_vertex_input(&descriptor.state.vertex_input)?;
        }

        let lock = self.context.lock()?;
        let gl = lock.gl();
        let mut shaders = Vec::with_capacity(descriptor.stages.len());
        let delete_all = |shaders: &[GLuint]| shaders.iter().for_each(|s| gl.delete_shader(*s));

        for stage in &descriptor.stages {
            let ShaderSource::Glsl(source) = &stage.source else {
                unreachable!("SPIR-V rejected above");
            };
            let shader = gl.create_shader(convert_shader_stage(stage.stage));
            shaders.push(shader);
            if let Err(log) = gl.compile_shader(shader, source) {
                delete_all(&shaders);
                return Err(GraphicsError::ResourceCreationFailed(format!(
                    "{:?} shader failed to compile: {log}",
                    stage.stage
                )));
            }
        }

        let program = gl.create_program();
        for shader in &shaders {
            gl.attach_shader(program, *shader);
        }
        let linked = gl.link_program(program);
        for shader in &shaders {
            gl.detach_shader(program, *shader);
        }
        delete_all(&shaders);
        if let Err(log) = linked {
            gl.delete_program(program);
            return Err(GraphicsError::ResourceCreationFailed(format!(
                "program failed to link: {log}"
            )));
        }
        if let Err(e) = check_creation(&lock, "glLinkProgram") {
            gl.delete_program(program);
            return Err(e);
        }
        log::trace!(
            "GL: linked program {program} ({})",
            descriptor.label.as_deref().unwrap_or("unlabeled")
        );
        Ok(GpuPipeline::Gl {
            context: self.context.clone(),
            program,
        })
    }

    /// Fences start without a sync object; `signaled` fences report success
    /// until reset.
    pub(crate) fn create_fence(&self, signaled: bool) -> GpuFence {
        GpuFence::Gl {
            context: self.context.clone(),
            sync: Mutex::new(None),
            signaled: AtomicBool::new(signaled),
        }
    }

    // ========================================================================
    // Submission
    // ========================================================================

    /// Replays the batches in order; returns the number of executed
    /// operations.
    pub(crate) fn submit(&self, batches: &[SubmitBatch<'_>], fence: Option<&Fence>) -> GraphicsResult<u64> {
        let lock = self.context.lock()?;
        let gl = lock.gl();
        let mut executed = 0;
        for batch in batches {
            batch.wait_emulated();
            for list in &batch.lists {
                let mut replay = ReplayState::new(self, gl);
                replay.execute(list);
                executed += replay.finish();
            }
            batch.signal_emulated();
        }
        if let Some(fence) = fence {
            insert_fence(gl, fence);
        }
        check_lost(&lock, "submit")?;
        Ok(executed)
    }

    /// Blits each swap chain image to the default framebuffer and swaps.
    pub(crate) fn present(&self, info: &PresentInfo<'_>) -> GraphicsResult<()> {
        for semaphore in &info.wait_semaphores {
            if !semaphore.consume_emulated() {
                log::warn!("GL: presenting without a signaled wait semaphore");
            }
        }
        let lock = self.context.lock()?;
        let gl = lock.gl();
        for (swap_chain, index) in &info.swap_chains {
            let image = swap_chain.image(*index);
            let extent = swap_chain.extent();
            let (width, height) = (extent.width as GLint, extent.height as GLint);
            gl.bind_framebuffer(GL_READ_FRAMEBUFFER, self.read_fbo);
            attach_texture(gl, GL_READ_FRAMEBUFFER, GL_COLOR_ATTACHMENT0, image, 0, 0);
            gl.read_buffer(GL_COLOR_ATTACHMENT0);
            gl.bind_framebuffer(GL_DRAW_FRAMEBUFFER, 0);
            // Images are stored top row first; the default framebuffer is bottom-up.
            gl.blit_framebuffer(
                0,
                0,
                width,
                height,
                0,
                height,
                width,
                0,
                GL_COLOR_BUFFER_BIT,
                GL_NEAREST,
            );
            gl.bind_framebuffer(GL_READ_FRAMEBUFFER, 0);
        }
        check_lost(&lock, "present")?;
        self.context.swap_buffers()
    }

    pub(crate) fn wait_idle(&self) -> GraphicsResult<()> {
        let lock = self.context.lock()?;
        lock.gl().finish();
        check_lost(&lock, "glFinish")
    }
}

impl Drop for GlBackend {
    fn drop(&mut self) {
        match self.context.lock() {
            Ok(lock) => {
                let gl = lock.gl();
                gl.bind_vertex_array(0);
                gl.delete_vertex_array(self.vao);
                gl.delete_framebuffer(self.read_fbo);
                gl.delete_framebuffer(self.draw_fbo);
            }
            Err(err) => log::warn!("GL: leaking device objects on unusable context: {err}"),
        }
    }
}

impl std::fmt::Debug for GlBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlBackend")
            .field("profile", &self.profile)
            .field("version", &self.version)
            .field("context", &self.context)
            .field("validation", &self.validation)
            .finish_non_exhaustive()
    }
}

/// Checks a vertex input layout for clashes GL would resolve silently:
/// repeated binding numbers or attribute locations, and attributes reading
/// undeclared bindings.
fn validate_vertex_input(input: &VertexInputState) -> GraphicsResult<()> {
    let mut bindings = BTreeSet::new();
    for binding in &input.bindings {
        if !bindings.insert(binding.binding) {
            return Err(GraphicsError::InvalidParameter(format!(
                "vertex binding {} declared twice",
                binding.binding
            )));
        }
    }
    let mut locations = BTreeSet::new();
    for attribute in &input.attributes {
        if !locations.insert(attribute.location) {
            return Err(GraphicsError::InvalidParameter(format!(
                "vertex attribute location {} used twice",
                attribute.location
            )));
        }
        if !bindings.contains(&attribute.binding) {
            return Err(GraphicsError::InvalidParameter(format!(
                "vertex attribute {} reads undeclared binding {}",
                attribute.location, attribute.binding
            )));
        }
    }
    Ok(())
}

/// Replaces the fence's sync object with one covering all prior commands.
fn insert_fence(gl: &dyn GlApi, fence: &Fence) {
    let GpuFence::Gl { sync, signaled, .. } = &fence.gpu else {
        panic!("fence does not belong to a GL device");
    };
    let new = gl.fence_sync();
    gl.flush();
    if let Some(old) = sync.lock().replace(new) {
        gl.delete_sync(old);
    }
    signaled.store(false, Ordering::Release);
}

// ============================================================================
// Host access helpers used by the resource objects
// ============================================================================

pub(crate) fn write_buffer(
    context: &GlContext,
    name: GLuint,
    offset: u64,
    data: &[u8],
) -> GraphicsResult<()> {
    let lock = context.lock()?;
    let gl = lock.gl();
    gl.bind_buffer(GL_COPY_WRITE_BUFFER, name);
    gl.buffer_sub_data(GL_COPY_WRITE_BUFFER, offset as GLintptr, data);
    gl.bind_buffer(GL_COPY_WRITE_BUFFER, 0);
    check_lost(&lock, "glBufferSubData")
}

pub(crate) fn read_buffer(
    context: &GlContext,
    name: GLuint,
    offset: u64,
    size: u64,
) -> GraphicsResult<Vec<u8>> {
    let lock = context.lock()?;
    let gl = lock.gl();
    let mut data = vec![0; size as usize];
    gl.bind_buffer(GL_COPY_READ_BUFFER, name);
    gl.get_buffer_sub_data(GL_COPY_READ_BUFFER, offset as GLintptr, &mut data);
    gl.bind_buffer(GL_COPY_READ_BUFFER, 0);
    check_lost(&lock, "glGetBufferSubData")?;
    Ok(data)
}

pub(crate) fn query_results(
    context: &GlContext,
    names: &[GLuint],
    flags: QueryResultFlags,
) -> GraphicsResult<Vec<u64>> {
    let lock = context.lock()?;
    let gl = lock.gl();
    let with_availability = flags.contains(QueryResultFlags::WITH_AVAILABILITY);
    let mut results = Vec::with_capacity(names.len() * if with_availability { 2 } else { 1 });
    for &name in names {
        // glGetQueryObject(GL_QUERY_RESULT) blocks until the result exists.
        let available =
            flags.contains(QueryResultFlags::WAIT) || gl.get_query_result_available(name);
        if !available && !flags.contains(QueryResultFlags::PARTIAL) {
            return Err(GraphicsError::NotReady);
        }
        results.push(if available { gl.get_query_result(name) } else { 0 });
        if with_availability {
            results.push(u64::from(available));
        }
    }
    check_lost(&lock, "glGetQueryObject")?;
    Ok(results)
}

pub(crate) fn wait_sync(
    context: &GlContext,
    sync: &Mutex<Option<GLsync>>,
    signaled: &AtomicBool,
    timeout: Duration,
) -> GraphicsResult<WaitResult> {
    let mut sync = sync.lock();
    let Some(handle) = *sync else {
        return Ok(if signaled.load(Ordering::Acquire) {
            WaitResult::Success
        } else {
            WaitResult::TimeOut
        });
    };
    let lock = context.lock()?;
    let gl = lock.gl();
    let nanos = u64::try_from(timeout.as_nanos()).unwrap_or(u64::MAX);
    match gl.client_wait_sync(handle, GL_SYNC_FLUSH_COMMANDS_BIT, nanos) {
        GL_ALREADY_SIGNALED | GL_CONDITION_SATISFIED => {
            gl.delete_sync(handle);
            *sync = None;
            signaled.store(true, Ordering::Release);
            Ok(WaitResult::Success)
        }
        GL_TIMEOUT_EXPIRED => Ok(WaitResult::TimeOut),
        status => {
            log::error!("GL: glClientWaitSync failed ({status:#x})");
            context.mark_lost();
            Err(GraphicsError::DeviceLost)
        }
    }
}

pub(crate) fn reset_sync(
    context: &GlContext,
    sync: &Mutex<Option<GLsync>>,
    signaled: &AtomicBool,
) -> GraphicsResult<()> {
    if let Some(handle) = sync.lock().take() {
        let lock = context.lock()?;
        lock.gl().delete_sync(handle);
    }
    signaled.store(false, Ordering::Release);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Format, ImageUsageFlags, SampleCount, VertexInputRate};

    fn backend(version: &str, profile: GlProfile) -> (GlBackend, RecordingGl) {
        let gl = RecordingGl::with_version(version);
        let context = Arc::new(GlContext::new(
            Arc::new(HeadlessPlatform::new()),
            Arc::new(gl.clone()),
        ));
        let backend = GlBackend::new(context, profile, false).unwrap();
        gl.clear_calls();
        (backend, gl)
    }

    #[test]
    fn test_vertex_input_clashes_are_rejected() {
        let input = VertexInputState::default()
            .with_binding(0, 16, VertexInputRate::Vertex)
            .with_attribute(0, 0, Format::Rgba32Float, 0);
        assert!(validate_vertex_input(&input).is_ok());

        let repeated = input.clone().with_attribute(0, 0, Format::R32Float, 0);
        assert!(matches!(
            validate_vertex_input(&repeated),
            Err(GraphicsError::InvalidParameter(_))
        ));
        let undeclared = input.clone().with_attribute(1, 3, Format::R32Float, 0);
        assert!(matches!(
            validate_vertex_input(&undeclared),
            Err(GraphicsError::InvalidParameter(_))
        ));
        let twice = input.with_binding(0, 32, VertexInputRate::Instance);
        assert!(matches!(
            validate_vertex_input(&twice),
            Err(GraphicsError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_profile_rejects_old_context() {
        let gl = RecordingGl::with_version("3.3.0");
        let context = Arc::new(GlContext::new(Arc::new(HeadlessPlatform::new()), Arc::new(gl)));
        let err = GlBackend::new(context, GlProfile::Gl4, false).unwrap_err();
        assert!(matches!(err, GraphicsError::InitializationFailed(_)));
    }

    #[test]
    fn test_buffer_creation_calls() {
        let (backend, gl) = backend("4.6.0", GlProfile::Gl4);
        let buffer = backend
            .create_buffer(&BufferDescriptor::new(64, Default::default()))
            .unwrap();
        let name = buffer.gl_name();
        assert_eq!(
            gl.calls(),
            vec![
                GlCall::GenBuffer(name),
                GlCall::BindBuffer {
                    target: GL_COPY_WRITE_BUFFER,
                    buffer: name
                },
                GlCall::BufferData {
                    target: GL_COPY_WRITE_BUFFER,
                    size: 64,
                    usage: GL_STATIC_DRAW
                },
                GlCall::BindBuffer {
                    target: GL_COPY_WRITE_BUFFER,
                    buffer: 0
                },
            ]
        );
    }

    #[test]
    fn test_image_targets() {
        let (backend, _gl) = backend("4.6.0", GlProfile::Gl4);
        let usage = ImageUsageFlags::SAMPLED;
        let plain = ImageDescriptor::new_2d(4, 4, Format::Rgba8Unorm, usage);
        let array = plain.clone().with_array_layers(3);
        let msaa = plain.clone().with_samples(SampleCount::X4);
        assert_eq!(backend.create_image(&plain).unwrap().gl_texture().1, GL_TEXTURE_2D);
        assert_eq!(backend.create_image(&array).unwrap().gl_texture().1, GL_TEXTURE_2D_ARRAY);
        assert_eq!(
            backend.create_image(&msaa).unwrap().gl_texture().1,
            GL_TEXTURE_2D_MULTISAMPLE
        );
    }

    #[test]
    fn test_gl3_images_allocate_every_level() {
        let (backend, gl) = backend("3.3.0", GlProfile::Gl3);
        let descriptor =
            ImageDescriptor::new_2d(8, 8, Format::Rgba8Unorm, ImageUsageFlags::SAMPLED)
                .with_mip_levels(3);
        backend.create_image(&descriptor).unwrap();
        let levels = gl
            .calls()
            .into_iter()
            .filter(|call| matches!(call, GlCall::TexImage2D { .. }))
            .count();
        assert_eq!(levels, 3);
    }

    #[test]
    fn test_compile_failure_is_creation_error() {
        let (backend, gl) = backend("4.6.0", GlProfile::Gl4);
        gl.fail_shader_compilation("0:1: syntax error");
        let descriptor = PipelineDescriptor {
            label: None,
            bind_point: Default::default(),
            stages: vec![crate::types::ShaderStage::new(
                ShaderStageFlags::VERTEX,
                ShaderSource::Glsl("void main() {}".to_string()),
            )],
            state: Default::default(),
            render_pass: None,
            subpass: 0,
        };
        let err = backend.create_pipeline(&descriptor).unwrap_err();
        assert!(matches!(err, GraphicsError::ResourceCreationFailed(ref log) if log.contains("syntax error")));
        assert!(gl.calls().iter().any(|call| matches!(call, GlCall::DeleteShader(_))));
    }

    #[test]
    fn test_gl3_rejects_compute() {
        let (backend, _gl) = backend("3.3.0", GlProfile::Gl3);
        let descriptor = PipelineDescriptor {
            label: None,
            bind_point: crate::types::PipelineBindPoint::Compute,
            stages: vec![crate::types::ShaderStage::new(
                ShaderStageFlags::COMPUTE,
                ShaderSource::Glsl("void main() {}".to_string()),
            )],
            state: Default::default(),
            render_pass: None,
            subpass: 0,
        };
        assert!(matches!(
            backend.create_pipeline(&descriptor),
            Err(GraphicsError::FeatureNotSupported(_))
        ));
    }

    #[test]
    fn test_wait_sync_consumes_sync_object() {
        let (backend, gl) = backend("4.6.0", GlProfile::Gl4);
        let fence = backend.create_fence(false);
        let GpuFence::Gl {
            context,
            sync,
            signaled,
        } = &fence
        else {
            unreachable!()
        };
        assert_eq!(
            wait_sync(&context, &sync, &signaled, Duration::ZERO).unwrap(),
            WaitResult::TimeOut
        );
        *sync.lock() = Some(7);
        assert_eq!(
            wait_sync(&context, &sync, &signaled, Duration::ZERO).unwrap(),
            WaitResult::Success
        );
        assert!(sync.lock().is_none());
        assert!(gl.calls().contains(&GlCall::DeleteSync(7)));
    }

    #[test]
    fn test_wait_sync_on_lost_context() {
        let (backend, gl) = backend("4.6.0", GlProfile::Gl4);
        let sync = Mutex::new(Some(3));
        let signaled = AtomicBool::new(false);
        gl.lose_context();
        let result = wait_sync(backend.context(), &sync, &signaled, Duration::from_millis(1));
        assert_eq!(result, Err(GraphicsError::DeviceLost));
        assert!(backend.context().is_lost());
    }
}
