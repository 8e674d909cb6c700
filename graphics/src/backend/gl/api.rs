//! The OpenGL entry points used by the GL backends.
//!
//! [`GlApi`] has one method per native function, with GL-typed arguments and
//! object names passed as plain `GLuint`. Every method must only be called
//! while the owning context is current (through a `ContextLock`).
//!
//! Two implementations ship with the crate:
//! - [`RecordingGl`](super::RecordingGl) logs every state-changing call
//! - `GlowApi` (feature `gl-native`) forwards to a `glow::Context`

use super::constants::*;

/// OpenGL entry points, one method per native function.
pub trait GlApi: Send + Sync {
    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// `glGetError`
    fn get_error(&self) -> GLenum;
    /// `glGetString`
    fn get_string(&self, name: GLenum) -> String;
    /// `glCheckFramebufferStatus`
    fn check_framebuffer_status(&self, target: GLenum) -> GLenum;
    /// `glGetQueryObjectui64v(name, GL_QUERY_RESULT)`
    fn get_query_result(&self, query: GLuint) -> u64;
    /// `glGetQueryObjectuiv(name, GL_QUERY_RESULT_AVAILABLE)`
    fn get_query_result_available(&self, query: GLuint) -> bool;
    /// `glGetBufferSubData`
    fn get_buffer_sub_data(&self, target: GLenum, offset: GLintptr, data: &mut [u8]);

    // ------------------------------------------------------------------
    // Object lifetime
    // ------------------------------------------------------------------

    /// `glGenBuffers(1, ..)`
    fn gen_buffer(&self) -> GLuint;
    /// `glDeleteBuffers(1, ..)`
    fn delete_buffer(&self, buffer: GLuint);
    /// `glGenTextures(1, ..)`
    fn gen_texture(&self) -> GLuint;
    /// `glDeleteTextures(1, ..)`
    fn delete_texture(&self, texture: GLuint);
    /// `glGenSamplers(1, ..)`
    fn gen_sampler(&self) -> GLuint;
    /// `glDeleteSamplers(1, ..)`
    fn delete_sampler(&self, sampler: GLuint);
    /// `glGenFramebuffers(1, ..)`
    fn gen_framebuffer(&self) -> GLuint;
    /// `glDeleteFramebuffers(1, ..)`
    fn delete_framebuffer(&self, framebuffer: GLuint);
    /// `glGenVertexArrays(1, ..)`
    fn gen_vertex_array(&self) -> GLuint;
    /// `glDeleteVertexArrays(1, ..)`
    fn delete_vertex_array(&self, array: GLuint);
    /// `glGenQueries(1, ..)`
    fn gen_query(&self) -> GLuint;
    /// `glDeleteQueries(1, ..)`
    fn delete_query(&self, query: GLuint);

    // ------------------------------------------------------------------
    // Buffers
    // ------------------------------------------------------------------

    /// `glBindBuffer`
    fn bind_buffer(&self, target: GLenum, buffer: GLuint);
    /// `glBindBufferRange`
    fn bind_buffer_range(
        &self,
        target: GLenum,
        index: GLuint,
        buffer: GLuint,
        offset: GLintptr,
        size: GLsizeiptr,
    );
    /// `glBufferData` with no initial contents.
    fn buffer_data_size(&self, target: GLenum, size: GLsizeiptr, usage: GLenum);
    /// `glBufferSubData`
    fn buffer_sub_data(&self, target: GLenum, offset: GLintptr, data: &[u8]);
    /// `glCopyBufferSubData`
    fn copy_buffer_sub_data(
        &self,
        read_target: GLenum,
        write_target: GLenum,
        read_offset: GLintptr,
        write_offset: GLintptr,
        size: GLsizeiptr,
    );

    // ------------------------------------------------------------------
    // Textures and samplers
    // ------------------------------------------------------------------

    /// `glActiveTexture`
    fn active_texture(&self, unit: GLenum);
    /// `glBindTexture`
    fn bind_texture(&self, target: GLenum, texture: GLuint);
    /// `glTexStorage2D`
    fn tex_storage_2d(
        &self,
        target: GLenum,
        levels: GLsizei,
        internal_format: GLenum,
        width: GLsizei,
        height: GLsizei,
    );
    /// `glTexStorage3D`
    fn tex_storage_3d(
        &self,
        target: GLenum,
        levels: GLsizei,
        internal_format: GLenum,
        width: GLsizei,
        height: GLsizei,
        depth: GLsizei,
    );
    /// `glTexImage2D` with no initial contents.
    #[allow(clippy::too_many_arguments)]
    fn tex_image_2d(
        &self,
        target: GLenum,
        level: GLint,
        internal_format: GLenum,
        width: GLsizei,
        height: GLsizei,
        format: GLenum,
        ty: GLenum,
    );
    /// `glTexImage3D` with no initial contents.
    #[allow(clippy::too_many_arguments)]
    fn tex_image_3d(
        &self,
        target: GLenum,
        level: GLint,
        internal_format: GLenum,
        width: GLsizei,
        height: GLsizei,
        depth: GLsizei,
        format: GLenum,
        ty: GLenum,
    );
    /// `glTexImage2DMultisample`
    fn tex_image_2d_multisample(
        &self,
        target: GLenum,
        samples: GLsizei,
        internal_format: GLenum,
        width: GLsizei,
        height: GLsizei,
    );
    /// `glTexSubImage2D` sourcing from the bound pixel unpack buffer.
    #[allow(clippy::too_many_arguments)]
    fn tex_sub_image_2d_pbo(
        &self,
        target: GLenum,
        level: GLint,
        x: GLint,
        y: GLint,
        width: GLsizei,
        height: GLsizei,
        format: GLenum,
        ty: GLenum,
        offset: GLintptr,
    );
    /// `glTexSubImage3D` sourcing from the bound pixel unpack buffer.
    #[allow(clippy::too_many_arguments)]
    fn tex_sub_image_3d_pbo(
        &self,
        target: GLenum,
        level: GLint,
        x: GLint,
        y: GLint,
        z: GLint,
        width: GLsizei,
        height: GLsizei,
        depth: GLsizei,
        format: GLenum,
        ty: GLenum,
        offset: GLintptr,
    );
    /// `glTexParameteri`
    fn tex_parameter_i(&self, target: GLenum, pname: GLenum, value: GLint);
    /// `glPixelStorei`
    fn pixel_store_i(&self, pname: GLenum, value: GLint);
    /// `glBindSampler`
    fn bind_sampler(&self, unit: GLuint, sampler: GLuint);
    /// `glSamplerParameteri`
    fn sampler_parameter_i(&self, sampler: GLuint, pname: GLenum, value: GLint);
    /// `glSamplerParameterf`
    fn sampler_parameter_f(&self, sampler: GLuint, pname: GLenum, value: GLfloat);
    /// `glSamplerParameterfv`
    fn sampler_parameter_fv(&self, sampler: GLuint, pname: GLenum, values: &[GLfloat]);

    // ------------------------------------------------------------------
    // Framebuffers
    // ------------------------------------------------------------------

    /// `glBindFramebuffer`
    fn bind_framebuffer(&self, target: GLenum, framebuffer: GLuint);
    /// `glFramebufferTexture2D`
    fn framebuffer_texture_2d(
        &self,
        target: GLenum,
        attachment: GLenum,
        texture_target: GLenum,
        texture: GLuint,
        level: GLint,
    );
    /// `glFramebufferTextureLayer`
    fn framebuffer_texture_layer(
        &self,
        target: GLenum,
        attachment: GLenum,
        texture: GLuint,
        level: GLint,
        layer: GLint,
    );
    /// `glDrawBuffers`
    fn draw_buffers(&self, buffers: &[GLenum]);
    /// `glReadBuffer`
    fn read_buffer(&self, source: GLenum);
    /// `glBlitFramebuffer`
    #[allow(clippy::too_many_arguments)]
    fn blit_framebuffer(
        &self,
        src_x0: GLint,
        src_y0: GLint,
        src_x1: GLint,
        src_y1: GLint,
        dst_x0: GLint,
        dst_y0: GLint,
        dst_x1: GLint,
        dst_y1: GLint,
        mask: GLbitfield,
        filter: GLenum,
    );
    /// `glClearBufferfv`
    fn clear_buffer_fv(&self, buffer: GLenum, draw_buffer: GLint, values: &[GLfloat]);
    /// `glClearBufferiv`
    fn clear_buffer_iv(&self, buffer: GLenum, draw_buffer: GLint, values: &[GLint]);
    /// `glClearBufferuiv`
    fn clear_buffer_uiv(&self, buffer: GLenum, draw_buffer: GLint, values: &[GLuint]);
    /// `glClearBufferfi`
    fn clear_buffer_fi(&self, buffer: GLenum, draw_buffer: GLint, depth: GLfloat, stencil: GLint);

    // ------------------------------------------------------------------
    // Programs
    // ------------------------------------------------------------------

    /// `glCreateShader`
    fn create_shader(&self, kind: GLenum) -> GLuint;
    /// `glShaderSource` + `glCompileShader`; returns the info log on failure.
    fn compile_shader(&self, shader: GLuint, source: &str) -> Result<(), String>;
    /// `glDeleteShader`
    fn delete_shader(&self, shader: GLuint);
    /// `glCreateProgram`
    fn create_program(&self) -> GLuint;
    /// `glAttachShader`
    fn attach_shader(&self, program: GLuint, shader: GLuint);
    /// `glDetachShader`
    fn detach_shader(&self, program: GLuint, shader: GLuint);
    /// `glLinkProgram`; returns the info log on failure.
    fn link_program(&self, program: GLuint) -> Result<(), String>;
    /// `glDeleteProgram`
    fn delete_program(&self, program: GLuint);
    /// `glUseProgram`
    fn use_program(&self, program: GLuint);

    // ------------------------------------------------------------------
    // Uniforms
    // ------------------------------------------------------------------

    /// `glUniform1fv`
    fn uniform_1fv(&self, location: GLint, values: &[GLfloat]);
    /// `glUniform2fv`
    fn uniform_2fv(&self, location: GLint, values: &[GLfloat]);
    /// `glUniform3fv`
    fn uniform_3fv(&self, location: GLint, values: &[GLfloat]);
    /// `glUniform4fv`
    fn uniform_4fv(&self, location: GLint, values: &[GLfloat]);
    /// `glUniformMatrix2fv`
    fn uniform_matrix_2fv(&self, location: GLint, transpose: GLboolean, values: &[GLfloat]);
    /// `glUniformMatrix3fv`
    fn uniform_matrix_3fv(&self, location: GLint, transpose: GLboolean, values: &[GLfloat]);
    /// `glUniformMatrix4fv`
    fn uniform_matrix_4fv(&self, location: GLint, transpose: GLboolean, values: &[GLfloat]);
    /// `glUniform1iv`
    fn uniform_1iv(&self, location: GLint, values: &[GLint]);
    /// `glUniform2iv`
    fn uniform_2iv(&self, location: GLint, values: &[GLint]);
    /// `glUniform3iv`
    fn uniform_3iv(&self, location: GLint, values: &[GLint]);
    /// `glUniform4iv`
    fn uniform_4iv(&self, location: GLint, values: &[GLint]);
    /// `glUniform1uiv`
    fn uniform_1uiv(&self, location: GLint, values: &[GLuint]);
    /// `glUniform2uiv`
    fn uniform_2uiv(&self, location: GLint, values: &[GLuint]);
    /// `glUniform3uiv`
    fn uniform_3uiv(&self, location: GLint, values: &[GLuint]);
    /// `glUniform4uiv`
    fn uniform_4uiv(&self, location: GLint, values: &[GLuint]);

    // ------------------------------------------------------------------
    // Fixed-function state
    // ------------------------------------------------------------------

    /// `glEnable`
    fn enable(&self, cap: GLenum);
    /// `glDisable`
    fn disable(&self, cap: GLenum);
    /// `glViewport`
    fn viewport(&self, x: GLint, y: GLint, width: GLsizei, height: GLsizei);
    /// `glDepthRange`
    fn depth_range(&self, near: f64, far: f64);
    /// `glScissor`
    fn scissor(&self, x: GLint, y: GLint, width: GLsizei, height: GLsizei);
    /// `glLineWidth`
    fn line_width(&self, width: GLfloat);
    /// `glPolygonOffset`
    fn polygon_offset(&self, factor: GLfloat, units: GLfloat);
    /// `glPolygonOffsetClamp`
    fn polygon_offset_clamp(&self, factor: GLfloat, units: GLfloat, clamp: GLfloat);
    /// `glPolygonMode`
    fn polygon_mode(&self, face: GLenum, mode: GLenum);
    /// `glCullFace`
    fn cull_face(&self, mode: GLenum);
    /// `glFrontFace`
    fn front_face(&self, mode: GLenum);
    /// `glBlendColor`
    fn blend_color(&self, r: GLfloat, g: GLfloat, b: GLfloat, a: GLfloat);
    /// `glBlendFuncSeparate`
    fn blend_func_separate(&self, src_rgb: GLenum, dst_rgb: GLenum, src_alpha: GLenum, dst_alpha: GLenum);
    /// `glBlendEquationSeparate`
    fn blend_equation_separate(&self, mode_rgb: GLenum, mode_alpha: GLenum);
    /// `glColorMask`
    fn color_mask(&self, r: GLboolean, g: GLboolean, b: GLboolean, a: GLboolean);
    /// `glLogicOp`
    fn logic_op(&self, op: GLenum);
    /// `glDepthFunc`
    fn depth_func(&self, func: GLenum);
    /// `glDepthMask`
    fn depth_mask(&self, write: GLboolean);
    /// `glStencilFuncSeparate`
    fn stencil_func_separate(&self, face: GLenum, func: GLenum, reference: GLint, mask: GLuint);
    /// `glStencilOpSeparate`
    fn stencil_op_separate(&self, face: GLenum, sfail: GLenum, dpfail: GLenum, dppass: GLenum);
    /// `glStencilMaskSeparate`
    fn stencil_mask_separate(&self, face: GLenum, mask: GLuint);
    /// `glMinSampleShading`
    fn min_sample_shading(&self, value: GLfloat);
    /// `glPatchParameteri`
    fn patch_parameter_i(&self, pname: GLenum, value: GLint);

    // ------------------------------------------------------------------
    // Vertex input
    // ------------------------------------------------------------------

    /// `glBindVertexArray`
    fn bind_vertex_array(&self, array: GLuint);
    /// `glEnableVertexAttribArray`
    fn enable_vertex_attrib_array(&self, index: GLuint);
    /// `glDisableVertexAttribArray`
    fn disable_vertex_attrib_array(&self, index: GLuint);
    /// `glVertexAttribPointer`
    fn vertex_attrib_pointer(
        &self,
        index: GLuint,
        size: GLint,
        ty: GLenum,
        normalized: GLboolean,
        stride: GLsizei,
        offset: GLintptr,
    );
    /// `glVertexAttribIPointer`
    fn vertex_attrib_i_pointer(
        &self,
        index: GLuint,
        size: GLint,
        ty: GLenum,
        stride: GLsizei,
        offset: GLintptr,
    );
    /// `glVertexAttribDivisor`
    fn vertex_attrib_divisor(&self, index: GLuint, divisor: GLuint);

    // ------------------------------------------------------------------
    // Draws and dispatches
    // ------------------------------------------------------------------

    /// `glDrawArraysInstanced`
    fn draw_arrays_instanced(&self, mode: GLenum, first: GLint, count: GLsizei, instances: GLsizei);
    /// `glDrawArraysInstancedBaseInstance`
    fn draw_arrays_instanced_base_instance(
        &self,
        mode: GLenum,
        first: GLint,
        count: GLsizei,
        instances: GLsizei,
        base_instance: GLuint,
    );
    /// `glDrawElementsInstancedBaseVertex`
    fn draw_elements_instanced_base_vertex(
        &self,
        mode: GLenum,
        count: GLsizei,
        ty: GLenum,
        offset: GLintptr,
        instances: GLsizei,
        base_vertex: GLint,
    );
    /// `glDrawElementsInstancedBaseVertexBaseInstance`
    #[allow(clippy::too_many_arguments)]
    fn draw_elements_instanced_base_vertex_base_instance(
        &self,
        mode: GLenum,
        count: GLsizei,
        ty: GLenum,
        offset: GLintptr,
        instances: GLsizei,
        base_vertex: GLint,
        base_instance: GLuint,
    );
    /// `glMultiDrawArraysIndirect`
    fn multi_draw_arrays_indirect(&self, mode: GLenum, offset: GLintptr, draw_count: GLsizei, stride: GLsizei);
    /// `glMultiDrawElementsIndirect`
    fn multi_draw_elements_indirect(
        &self,
        mode: GLenum,
        ty: GLenum,
        offset: GLintptr,
        draw_count: GLsizei,
        stride: GLsizei,
    );
    /// `glDispatchCompute`
    fn dispatch_compute(&self, x: GLuint, y: GLuint, z: GLuint);
    /// `glDispatchComputeIndirect`
    fn dispatch_compute_indirect(&self, offset: GLintptr);
    /// `glMemoryBarrier`
    fn memory_barrier(&self, barriers: GLbitfield);

    // ------------------------------------------------------------------
    // Queries and synchronisation
    // ------------------------------------------------------------------

    /// `glBeginQuery`
    fn begin_query(&self, target: GLenum, query: GLuint);
    /// `glEndQuery`
    fn end_query(&self, target: GLenum);
    /// `glQueryCounter`
    fn query_counter(&self, query: GLuint, target: GLenum);
    /// `glFenceSync(GL_SYNC_GPU_COMMANDS_COMPLETE, 0)`
    fn fence_sync(&self) -> GLsync;
    /// `glClientWaitSync`
    fn client_wait_sync(&self, sync: GLsync, flags: GLbitfield, timeout_ns: u64) -> GLenum;
    /// `glDeleteSync`
    fn delete_sync(&self, sync: GLsync);
    /// `glFlush`
    fn flush(&self);
    /// `glFinish`
    fn finish(&self);
}

/// Drains the GL error queue, logging every pending error against `call`.
///
/// Returns the first error found, `GL_NO_ERROR` when the queue was empty.
pub fn check_errors(gl: &dyn GlApi, call: &str) -> GLenum {
    let mut first = GL_NO_ERROR;
    // A lost context reports GL_CONTEXT_LOST forever; bound the loop.
    for _ in 0..16 {
        let error = gl.get_error();
        if error == GL_NO_ERROR {
            break;
        }
        log::error!("{call}: GL error {}", error_name(error));
        if first == GL_NO_ERROR {
            first = error;
        }
        if error == GL_CONTEXT_LOST {
            break;
        }
    }
    first
}

/// Human-readable name of a GL error code.
pub fn error_name(error: GLenum) -> &'static str {
    match error {
        GL_NO_ERROR => "GL_NO_ERROR",
        GL_INVALID_ENUM => "GL_INVALID_ENUM",
        GL_INVALID_VALUE => "GL_INVALID_VALUE",
        GL_INVALID_OPERATION => "GL_INVALID_OPERATION",
        GL_OUT_OF_MEMORY => "GL_OUT_OF_MEMORY",
        GL_INVALID_FRAMEBUFFER_OPERATION => "GL_INVALID_FRAMEBUFFER_OPERATION",
        GL_CONTEXT_LOST => "GL_CONTEXT_LOST",
        _ => "unknown GL error",
    }
}
