//! Instrumented GL entry points for headless validation.
//!
//! [`RecordingGl`] implements [`GlApi`] without a driver: every
//! state-changing call is appended to a log as a [`GlCall`], object names are
//! allocated from a counter, and buffer contents are shadowed in memory so
//! uploads, copies and read-backs behave like a real context. Query entry
//! points (`glGetError`, `glGetString`, ...) are answered but not logged.
//!
//! [`HeadlessPlatform`] is the matching [`PlatformContext`]: it counts
//! make-current / release / swap calls and can simulate a lost context.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::api::GlApi;
use super::constants::*;
use super::context::PlatformContext;
use crate::error::GraphicsError;

/// One logged GL call.
#[derive(Debug, Clone, PartialEq)]
pub enum GlCall {
    GenBuffer(GLuint),
    DeleteBuffer(GLuint),
    GenTexture(GLuint),
    DeleteTexture(GLuint),
    GenSampler(GLuint),
    DeleteSampler(GLuint),
    GenFramebuffer(GLuint),
    DeleteFramebuffer(GLuint),
    GenVertexArray(GLuint),
    DeleteVertexArray(GLuint),
    GenQuery(GLuint),
    DeleteQuery(GLuint),

    BindBuffer { target: GLenum, buffer: GLuint },
    BindBufferRange { target: GLenum, index: GLuint, buffer: GLuint, offset: GLintptr, size: GLsizeiptr },
    BufferData { target: GLenum, size: GLsizeiptr, usage: GLenum },
    BufferSubData { target: GLenum, offset: GLintptr, data: Vec<u8> },
    CopyBufferSubData { read_target: GLenum, write_target: GLenum, read_offset: GLintptr, write_offset: GLintptr, size: GLsizeiptr },

    ActiveTexture(GLenum),
    BindTexture { target: GLenum, texture: GLuint },
    TexStorage2D { target: GLenum, levels: GLsizei, internal_format: GLenum, width: GLsizei, height: GLsizei },
    TexStorage3D { target: GLenum, levels: GLsizei, internal_format: GLenum, width: GLsizei, height: GLsizei, depth: GLsizei },
    TexImage2D { target: GLenum, level: GLint, internal_format: GLenum, width: GLsizei, height: GLsizei, format: GLenum, ty: GLenum },
    TexImage3D { target: GLenum, level: GLint, internal_format: GLenum, width: GLsizei, height: GLsizei, depth: GLsizei, format: GLenum, ty: GLenum },
    TexImage2DMultisample { target: GLenum, samples: GLsizei, internal_format: GLenum, width: GLsizei, height: GLsizei },
    TexSubImage2D { target: GLenum, level: GLint, x: GLint, y: GLint, width: GLsizei, height: GLsizei, format: GLenum, ty: GLenum, offset: GLintptr },
    TexSubImage3D { target: GLenum, level: GLint, x: GLint, y: GLint, z: GLint, width: GLsizei, height: GLsizei, depth: GLsizei, format: GLenum, ty: GLenum, offset: GLintptr },
    TexParameteri { target: GLenum, pname: GLenum, value: GLint },
    PixelStorei { pname: GLenum, value: GLint },
    BindSampler { unit: GLuint, sampler: GLuint },
    SamplerParameteri { sampler: GLuint, pname: GLenum, value: GLint },
    SamplerParameterf { sampler: GLuint, pname: GLenum, value: GLfloat },
    SamplerParameterfv { sampler: GLuint, pname: GLenum, values: Vec<GLfloat> },

    BindFramebuffer { target: GLenum, framebuffer: GLuint },
    FramebufferTexture2D { target: GLenum, attachment: GLenum, texture_target: GLenum, texture: GLuint, level: GLint },
    FramebufferTextureLayer { target: GLenum, attachment: GLenum, texture: GLuint, level: GLint, layer: GLint },
    DrawBuffers(Vec<GLenum>),
    ReadBuffer(GLenum),
    BlitFramebuffer { src: [GLint; 4], dst: [GLint; 4], mask: GLbitfield, filter: GLenum },
    ClearBufferfv { buffer: GLenum, draw_buffer: GLint, values: Vec<GLfloat> },
    ClearBufferiv { buffer: GLenum, draw_buffer: GLint, values: Vec<GLint> },
    ClearBufferuiv { buffer: GLenum, draw_buffer: GLint, values: Vec<GLuint> },
    ClearBufferfi { buffer: GLenum, draw_buffer: GLint, depth: GLfloat, stencil: GLint },

    CreateShader { kind: GLenum, shader: GLuint },
    CompileShader { shader: GLuint, source: String },
    DeleteShader(GLuint),
    CreateProgram(GLuint),
    AttachShader { program: GLuint, shader: GLuint },
    DetachShader { program: GLuint, shader: GLuint },
    LinkProgram(GLuint),
    DeleteProgram(GLuint),
    UseProgram(GLuint),

    Uniform1fv { location: GLint, values: Vec<GLfloat> },
    Uniform2fv { location: GLint, values: Vec<GLfloat> },
    Uniform3fv { location: GLint, values: Vec<GLfloat> },
    Uniform4fv { location: GLint, values: Vec<GLfloat> },
    UniformMatrix2fv { location: GLint, transpose: GLboolean, values: Vec<GLfloat> },
    UniformMatrix3fv { location: GLint, transpose: GLboolean, values: Vec<GLfloat> },
    UniformMatrix4fv { location: GLint, transpose: GLboolean, values: Vec<GLfloat> },
    Uniform1iv { location: GLint, values: Vec<GLint> },
    Uniform2iv { location: GLint, values: Vec<GLint> },
    Uniform3iv { location: GLint, values: Vec<GLint> },
    Uniform4iv { location: GLint, values: Vec<GLint> },
    Uniform1uiv { location: GLint, values: Vec<GLuint> },
    Uniform2uiv { location: GLint, values: Vec<GLuint> },
    Uniform3uiv { location: GLint, values: Vec<GLuint> },
    Uniform4uiv { location: GLint, values: Vec<GLuint> },

    Enable(GLenum),
    Disable(GLenum),
    Viewport { x: GLint, y: GLint, width: GLsizei, height: GLsizei },
    DepthRange { near: f64, far: f64 },
    Scissor { x: GLint, y: GLint, width: GLsizei, height: GLsizei },
    LineWidth(GLfloat),
    PolygonOffset { factor: GLfloat, units: GLfloat },
    PolygonOffsetClamp { factor: GLfloat, units: GLfloat, clamp: GLfloat },
    PolygonMode { face: GLenum, mode: GLenum },
    CullFace(GLenum),
    FrontFace(GLenum),
    BlendColor([GLfloat; 4]),
    BlendFuncSeparate { src_rgb: GLenum, dst_rgb: GLenum, src_alpha: GLenum, dst_alpha: GLenum },
    BlendEquationSeparate { mode_rgb: GLenum, mode_alpha: GLenum },
    ColorMask([GLboolean; 4]),
    LogicOp(GLenum),
    DepthFunc(GLenum),
    DepthMask(GLboolean),
    StencilFuncSeparate { face: GLenum, func: GLenum, reference: GLint, mask: GLuint },
    StencilOpSeparate { face: GLenum, sfail: GLenum, dpfail: GLenum, dppass: GLenum },
    StencilMaskSeparate { face: GLenum, mask: GLuint },
    MinSampleShading(GLfloat),
    PatchParameteri { pname: GLenum, value: GLint },

    BindVertexArray(GLuint),
    EnableVertexAttribArray(GLuint),
    DisableVertexAttribArray(GLuint),
    VertexAttribPointer { index: GLuint, size: GLint, ty: GLenum, normalized: GLboolean, stride: GLsizei, offset: GLintptr },
    VertexAttribIPointer { index: GLuint, size: GLint, ty: GLenum, stride: GLsizei, offset: GLintptr },
    VertexAttribDivisor { index: GLuint, divisor: GLuint },

    DrawArraysInstanced { mode: GLenum, first: GLint, count: GLsizei, instances: GLsizei },
    DrawArraysInstancedBaseInstance { mode: GLenum, first: GLint, count: GLsizei, instances: GLsizei, base_instance: GLuint },
    DrawElementsInstancedBaseVertex { mode: GLenum, count: GLsizei, ty: GLenum, offset: GLintptr, instances: GLsizei, base_vertex: GLint },
    DrawElementsInstancedBaseVertexBaseInstance { mode: GLenum, count: GLsizei, ty: GLenum, offset: GLintptr, instances: GLsizei, base_vertex: GLint, base_instance: GLuint },
    MultiDrawArraysIndirect { mode: GLenum, offset: GLintptr, draw_count: GLsizei, stride: GLsizei },
    MultiDrawElementsIndirect { mode: GLenum, ty: GLenum, offset: GLintptr, draw_count: GLsizei, stride: GLsizei },
    DispatchCompute { x: GLuint, y: GLuint, z: GLuint },
    DispatchComputeIndirect(GLintptr),
    MemoryBarrier(GLbitfield),

    BeginQuery { target: GLenum, query: GLuint },
    EndQuery(GLenum),
    QueryCounter { query: GLuint, target: GLenum },
    FenceSync(GLsync),
    DeleteSync(GLsync),
    Flush,
    Finish,
}

#[derive(Debug, Default)]
struct RecordingState {
    calls: Vec<GlCall>,
    next_name: GLuint,
    next_sync: GLsync,
    pending_errors: VecDeque<GLenum>,
    context_lost: bool,
    compile_failure: Option<String>,
    bound_buffers: HashMap<GLenum, GLuint>,
    buffer_memory: HashMap<GLuint, Vec<u8>>,
    query_results: HashMap<GLuint, u64>,
}

impl RecordingState {
    fn alloc_name(&mut self) -> GLuint {
        self.next_name += 1;
        self.next_name
    }

    fn bound_memory(&mut self, target: GLenum) -> Option<&mut Vec<u8>> {
        let name = *self.bound_buffers.get(&target)?;
        self.buffer_memory.get_mut(&name)
    }
}

/// GL entry points that log calls instead of reaching a driver.
///
/// Cloning yields another handle on the same log.
#[derive(Debug, Clone)]
pub struct RecordingGl {
    version: Arc<str>,
    state: Arc<Mutex<RecordingState>>,
}

impl RecordingGl {
    /// Entry points reporting `GL_VERSION` 4.6.
    pub fn new() -> Self {
        Self::with_version("4.6.0 RecordingGl")
    }

    /// Entry points reporting the given `GL_VERSION` string.
    pub fn with_version(version: &str) -> Self {
        Self {
            version: Arc::from(version),
            state: Arc::new(Mutex::new(RecordingState::default())),
        }
    }

    /// Snapshot of every logged call.
    pub fn calls(&self) -> Vec<GlCall> {
        self.state.lock().calls.clone()
    }

    /// Returns the logged calls and clears the log.
    pub fn take_calls(&self) -> Vec<GlCall> {
        std::mem::take(&mut self.state.lock().calls)
    }

    /// Clears the log.
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Queues an error returned by the next `glGetError`.
    pub fn push_error(&self, error: GLenum) {
        self.state.lock().pending_errors.push_back(error);
    }

    /// From now on `glGetError` reports `GL_CONTEXT_LOST`.
    pub fn lose_context(&self) {
        self.state.lock().context_lost = true;
    }

    /// Makes every later shader compilation fail with `log`.
    pub fn fail_shader_compilation(&self, log: impl Into<String>) {
        self.state.lock().compile_failure = Some(log.into());
    }

    /// Sets the value returned for a query object.
    pub fn set_query_result(&self, query: GLuint, value: u64) {
        self.state.lock().query_results.insert(query, value);
    }

    /// Shadowed contents of a buffer object.
    pub fn buffer_contents(&self, buffer: GLuint) -> Option<Vec<u8>> {
        self.state.lock().buffer_memory.get(&buffer).cloned()
    }

    fn log(&self, call: GlCall) {
        self.state.lock().calls.push(call);
    }

    fn gen(&self, make: impl FnOnce(GLuint) -> GlCall) -> GLuint {
        let mut state = self.state.lock();
        let name = state.alloc_name();
        state.calls.push(make(name));
        name
    }
}

impl Default for RecordingGl {
    fn default() -> Self {
        Self::new()
    }
}

impl GlApi for RecordingGl {
    fn get_error(&self) -> GLenum {
        let mut state = self.state.lock();
        if state.context_lost {
            return GL_CONTEXT_LOST;
        }
        state.pending_errors.pop_front().unwrap_or(GL_NO_ERROR)
    }

    fn get_string(&self, name: GLenum) -> String {
        match name {
            GL_VERSION => self.version.to_string(),
            GL_VENDOR => "ashes".to_string(),
            GL_RENDERER => "RecordingGl".to_string(),
            _ => String::new(),
        }
    }

    fn check_framebuffer_status(&self, _target: GLenum) -> GLenum {
        GL_FRAMEBUFFER_COMPLETE
    }

    fn get_query_result(&self, query: GLuint) -> u64 {
        self.state.lock().query_results.get(&query).copied().unwrap_or(0)
    }

    fn get_query_result_available(&self, _query: GLuint) -> bool {
        true
    }

    fn get_buffer_sub_data(&self, target: GLenum, offset: GLintptr, data: &mut [u8]) {
        let mut state = self.state.lock();
        let Some(memory) = state.bound_memory(target) else {
            return;
        };
        let start = offset as usize;
        let end = (start + data.len()).min(memory.len());
        if start < end {
            data[..end - start].copy_from_slice(&memory[start..end]);
        }
    }

    fn gen_buffer(&self) -> GLuint {
        self.gen(GlCall::GenBuffer)
    }

    fn delete_buffer(&self, buffer: GLuint) {
        let mut state = self.state.lock();
        state.buffer_memory.remove(&buffer);
        state.calls.push(GlCall::DeleteBuffer(buffer));
    }

    fn gen_texture(&self) -> GLuint {
        self.gen(GlCall::GenTexture)
    }

    fn delete_texture(&self, texture: GLuint) {
        self.log(GlCall::DeleteTexture(texture));
    }

    fn gen_sampler(&self) -> GLuint {
        self.gen(GlCall::GenSampler)
    }

    fn delete_sampler(&self, sampler: GLuint) {
        self.log(GlCall::DeleteSampler(sampler));
    }

    fn gen_framebuffer(&self) -> GLuint {
        self.gen(GlCall::GenFramebuffer)
    }

    fn delete_framebuffer(&self, framebuffer: GLuint) {
        self.log(GlCall::DeleteFramebuffer(framebuffer));
    }

    fn gen_vertex_array(&self) -> GLuint {
        self.gen(GlCall::GenVertexArray)
    }

    fn delete_vertex_array(&self, array: GLuint) {
        self.log(GlCall::DeleteVertexArray(array));
    }

    fn gen_query(&self) -> GLuint {
        self.gen(GlCall::GenQuery)
    }

    fn delete_query(&self, query: GLuint) {
        self.log(GlCall::DeleteQuery(query));
    }

    fn bind_buffer(&self, target: GLenum, buffer: GLuint) {
        let mut state = self.state.lock();
        state.bound_buffers.insert(target, buffer);
        state.calls.push(GlCall::BindBuffer { target, buffer });
    }

    fn bind_buffer_range(
        &self,
        target: GLenum,
        index: GLuint,
        buffer: GLuint,
        offset: GLintptr,
        size: GLsizeiptr,
    ) {
        self.log(GlCall::BindBufferRange {
            target,
            index,
            buffer,
            offset,
            size,
        });
    }

    fn buffer_data_size(&self, target: GLenum, size: GLsizeiptr, usage: GLenum) {
        let mut state = self.state.lock();
        if let Some(&name) = state.bound_buffers.get(&target) {
            state.buffer_memory.insert(name, vec![0; size.max(0) as usize]);
        }
        state.calls.push(GlCall::BufferData {
            target,
            size,
            usage,
        });
    }

    fn buffer_sub_data(&self, target: GLenum, offset: GLintptr, data: &[u8]) {
        let mut state = self.state.lock();
        if let Some(memory) = state.bound_memory(target) {
            let start = offset as usize;
            let end = (start + data.len()).min(memory.len());
            if start < end {
                memory[start..end].copy_from_slice(&data[..end - start]);
            }
        }
        state.calls.push(GlCall::BufferSubData {
            target,
            offset,
            data: data.to_vec(),
        });
    }

    fn copy_buffer_sub_data(
        &self,
        read_target: GLenum,
        write_target: GLenum,
        read_offset: GLintptr,
        write_offset: GLintptr,
        size: GLsizeiptr,
    ) {
        let mut state = self.state.lock();
        let source = state.bound_memory(read_target).map(|memory| {
            let start = (read_offset as usize).min(memory.len());
            let end = (start + size as usize).min(memory.len());
            memory[start..end].to_vec()
        });
        if let (Some(source), Some(memory)) = (source, state.bound_memory(write_target)) {
            let start = (write_offset as usize).min(memory.len());
            let end = (start + source.len()).min(memory.len());
            memory[start..end].copy_from_slice(&source[..end - start]);
        }
        state.calls.push(GlCall::CopyBufferSubData {
            read_target,
            write_target,
            read_offset,
            write_offset,
            size,
        });
    }

    fn active_texture(&self, unit: GLenum) {
        self.log(GlCall::ActiveTexture(unit));
    }

    fn bind_texture(&self, target: GLenum, texture: GLuint) {
        self.log(GlCall::BindTexture { target, texture });
    }

    fn tex_storage_2d(
        &self,
        target: GLenum,
        levels: GLsizei,
        internal_format: GLenum,
        width: GLsizei,
        height: GLsizei,
    ) {
        self.log(GlCall::TexStorage2D {
            target,
            levels,
            internal_format,
            width,
            height,
        });
    }

    fn tex_storage_3d(
        &self,
        target: GLenum,
        levels: GLsizei,
        internal_format: GLenum,
        width: GLsizei,
        height: GLsizei,
        depth: GLsizei,
    ) {
        self.log(GlCall::TexStorage3D {
            target,
            levels,
            internal_format,
            width,
            height,
            depth,
        });
    }

    fn tex_image_2d(
        &self,
        target: GLenum,
        level: GLint,
        internal_format: GLenum,
        width: GLsizei,
        height: GLsizei,
        format: GLenum,
        ty: GLenum,
    ) {
        self.log(GlCall::TexImage2D {
            target,
            level,
            internal_format,
            width,
            height,
            format,
            ty,
        });
    }

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
    ) {
        self.log(GlCall::TexImage3D {
            target,
            level,
            internal_format,
            width,
            height,
            depth,
            format,
            ty,
        });
    }

    fn tex_image_2d_multisample(
        &self,
        target: GLenum,
        samples: GLsizei,
        internal_format: GLenum,
        width: GLsizei,
        height: GLsizei,
    ) {
        self.log(GlCall::TexImage2DMultisample {
            target,
            samples,
            internal_format,
            width,
            height,
        });
    }

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
    ) {
        self.log(GlCall::TexSubImage2D {
            target,
            level,
            x,
            y,
            width,
            height,
            format,
            ty,
            offset,
        });
    }

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
    ) {
        self.log(GlCall::TexSubImage3D {
            target,
            level,
            x,
            y,
            z,
            width,
            height,
            depth,
            format,
            ty,
            offset,
        });
    }

    fn tex_parameter_i(&self, target: GLenum, pname: GLenum, value: GLint) {
        self.log(GlCall::TexParameteri {
            target,
            pname,
            value,
        });
    }

    fn pixel_store_i(&self, pname: GLenum, value: GLint) {
        self.log(GlCall::PixelStorei { pname, value });
    }

    fn bind_sampler(&self, unit: GLuint, sampler: GLuint) {
        self.log(GlCall::BindSampler { unit, sampler });
    }

    fn sampler_parameter_i(&self, sampler: GLuint, pname: GLenum, value: GLint) {
        self.log(GlCall::SamplerParameteri {
            sampler,
            pname,
            value,
        });
    }

    fn sampler_parameter_f(&self, sampler: GLuint, pname: GLenum, value: GLfloat) {
        self.log(GlCall::SamplerParameterf {
            sampler,
            pname,
            value,
        });
    }

    fn sampler_parameter_fv(&self, sampler: GLuint, pname: GLenum, values: &[GLfloat]) {
        self.log(GlCall::SamplerParameterfv {
            sampler,
            pname,
            values: values.to_vec(),
        });
    }

    fn bind_framebuffer(&self, target: GLenum, framebuffer: GLuint) {
        self.log(GlCall::BindFramebuffer {
            target,
            framebuffer,
        });
    }

    fn framebuffer_texture_2d(
        &self,
        target: GLenum,
        attachment: GLenum,
        texture_target: GLenum,
        texture: GLuint,
        level: GLint,
    ) {
        self.log(GlCall::FramebufferTexture2D {
            target,
            attachment,
            texture_target,
            texture,
            level,
        });
    }

    fn framebuffer_texture_layer(
        &self,
        target: GLenum,
        attachment: GLenum,
        texture: GLuint,
        level: GLint,
        layer: GLint,
    ) {
        self.log(GlCall::FramebufferTextureLayer {
            target,
            attachment,
            texture,
            level,
            layer,
        });
    }

    fn draw_buffers(&self, buffers: &[GLenum]) {
        self.log(GlCall::DrawBuffers(buffers.to_vec()));
    }

    fn read_buffer(&self, source: GLenum) {
        self.log(GlCall::ReadBuffer(source));
    }

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
    ) {
        self.log(GlCall::BlitFramebuffer {
            src: [src_x0, src_y0, src_x1, src_y1],
            dst: [dst_x0, dst_y0, dst_x1, dst_y1],
            mask,
            filter,
        });
    }

    fn clear_buffer_fv(&self, buffer: GLenum, draw_buffer: GLint, values: &[GLfloat]) {
        self.log(GlCall::ClearBufferfv {
            buffer,
            draw_buffer,
            values: values.to_vec(),
        });
    }

    fn clear_buffer_iv(&self, buffer: GLenum, draw_buffer: GLint, values: &[GLint]) {
        self.log(GlCall::ClearBufferiv {
            buffer,
            draw_buffer,
            values: values.to_vec(),
        });
    }

    fn clear_buffer_uiv(&self, buffer: GLenum, draw_buffer: GLint, values: &[GLuint]) {
        self.log(GlCall::ClearBufferuiv {
            buffer,
            draw_buffer,
            values: values.to_vec(),
        });
    }

    fn clear_buffer_fi(&self, buffer: GLenum, draw_buffer: GLint, depth: GLfloat, stencil: GLint) {
        self.log(GlCall::ClearBufferfi {
            buffer,
            draw_buffer,
            depth,
            stencil,
        });
    }

    fn create_shader(&self, kind: GLenum) -> GLuint {
        self.gen(|shader| GlCall::CreateShader { kind, shader })
    }

    fn compile_shader(&self, shader: GLuint, source: &str) -> Result<(), String> {
        let mut state = self.state.lock();
        state.calls.push(GlCall::CompileShader {
            shader,
            source: source.to_string(),
        });
        match &state.compile_failure {
            Some(log) => Err(log.clone()),
            None => Ok(()),
        }
    }

    fn delete_shader(&self, shader: GLuint) {
        self.log(GlCall::DeleteShader(shader));
    }

    fn create_program(&self) -> GLuint {
        self.gen(GlCall::CreateProgram)
    }

    fn attach_shader(&self, program: GLuint, shader: GLuint) {
        self.log(GlCall::AttachShader { program, shader });
    }

    fn detach_shader(&self, program: GLuint, shader: GLuint) {
        self.log(GlCall::DetachShader { program, shader });
    }

    fn link_program(&self, program: GLuint) -> Result<(), String> {
        self.log(GlCall::LinkProgram(program));
        Ok(())
    }

    fn delete_program(&self, program: GLuint) {
        self.log(GlCall::DeleteProgram(program));
    }

    fn use_program(&self, program: GLuint) {
        self.log(GlCall::UseProgram(program));
    }

    fn uniform_1fv(&self, location: GLint, values: &[GLfloat]) {
        self.log(GlCall::Uniform1fv {
            location,
            values: values.to_vec(),
        });
    }

    fn uniform_2fv(&self, location: GLint, values: &[GLfloat]) {
        self.log(GlCall::Uniform2fv {
            location,
            values: values.to_vec(),
        });
    }

    fn uniform_3fv(&self, location: GLint, values: &[GLfloat]) {
        self.log(GlCall::Uniform3fv {
            location,
            values: values.to_vec(),
        });
    }

    fn uniform_4fv(&self, location: GLint, values: &[GLfloat]) {
        self.log(GlCall::Uniform4fv {
            location,
            values: values.to_vec(),
        });
    }

    fn uniform_matrix_2fv(&self, location: GLint, transpose: GLboolean, values: &[GLfloat]) {
        self.log(GlCall::UniformMatrix2fv {
            location,
            transpose,
            values: values.to_vec(),
        });
    }

    fn uniform_matrix_3fv(&self, location: GLint, transpose: GLboolean, values: &[GLfloat]) {
        self.log(GlCall::UniformMatrix3fv {
            location,
            transpose,
            values: values.to_vec(),
        });
    }

    fn uniform_matrix_4fv(&self, location: GLint, transpose: GLboolean, values: &[GLfloat]) {
        self.log(GlCall::UniformMatrix4fv {
            location,
            transpose,
            values: values.to_vec(),
        });
    }

    fn uniform_1iv(&self, location: GLint, values: &[GLint]) {
        self.log(GlCall::Uniform1iv {
            location,
            values: values.to_vec(),
        });
    }

    fn uniform_2iv(&self, location: GLint, values: &[GLint]) {
        self.log(GlCall::Uniform2iv {
            location,
            values: values.to_vec(),
        });
    }

    fn uniform_3iv(&self, location: GLint, values: &[GLint]) {
        self.log(GlCall::Uniform3iv {
            location,
            values: values.to_vec(),
        });
    }

    fn uniform_4iv(&self, location: GLint, values: &[GLint]) {
        self.log(GlCall::Uniform4iv {
            location,
            values: values.to_vec(),
        });
    }

    fn uniform_1uiv(&self, location: GLint, values: &[GLuint]) {
        self.log(GlCall::Uniform1uiv {
            location,
            values: values.to_vec(),
        });
    }

    fn uniform_2uiv(&self, location: GLint, values: &[GLuint]) {
        self.log(GlCall::Uniform2uiv {
            location,
            values: values.to_vec(),
        });
    }

    fn uniform_3uiv(&self, location: GLint, values: &[GLuint]) {
        self.log(GlCall::Uniform3uiv {
            location,
            values: values.to_vec(),
        });
    }

    fn uniform_4uiv(&self, location: GLint, values: &[GLuint]) {
        self.log(GlCall::Uniform4uiv {
            location,
            values: values.to_vec(),
        });
    }

    fn enable(&self, cap: GLenum) {
        self.log(GlCall::Enable(cap));
    }

    fn disable(&self, cap: GLenum) {
        self.log(GlCall::Disable(cap));
    }

    fn viewport(&self, x: GLint, y: GLint, width: GLsizei, height: GLsizei) {
        self.log(GlCall::Viewport {
            x,
            y,
            width,
            height,
        });
    }

    fn depth_range(&self, near: f64, far: f64) {
        self.log(GlCall::DepthRange { near, far });
    }

    fn scissor(&self, x: GLint, y: GLint, width: GLsizei, height: GLsizei) {
        self.log(GlCall::Scissor {
            x,
            y,
            width,
            height,
        });
    }

    fn line_width(&self, width: GLfloat) {
        self.log(GlCall::LineWidth(width));
    }

    fn polygon_offset(&self, factor: GLfloat, units: GLfloat) {
        self.log(GlCall::PolygonOffset { factor, units });
    }

    fn polygon_offset_clamp(&self, factor: GLfloat, units: GLfloat, clamp: GLfloat) {
        self.log(GlCall::PolygonOffsetClamp {
            factor,
            units,
            clamp,
        });
    }

    fn polygon_mode(&self, face: GLenum, mode: GLenum) {
        self.log(GlCall::PolygonMode { face, mode });
    }

    fn cull_face(&self, mode: GLenum) {
        self.log(GlCall::CullFace(mode));
    }

    fn front_face(&self, mode: GLenum) {
        self.log(GlCall::FrontFace(mode));
    }

    fn blend_color(&self, r: GLfloat, g: GLfloat, b: GLfloat, a: GLfloat) {
        self.log(GlCall::BlendColor([r, g, b, a]));
    }

    fn blend_func_separate(&self, src_rgb: GLenum, dst_rgb: GLenum, src_alpha: GLenum, dst_alpha: GLenum) {
        self.log(GlCall::BlendFuncSeparate {
            src_rgb,
            dst_rgb,
            src_alpha,
            dst_alpha,
        });
    }

    fn blend_equation_separate(&self, mode_rgb: GLenum, mode_alpha: GLenum) {
        self.log(GlCall::BlendEquationSeparate {
            mode_rgb,
            mode_alpha,
        });
    }

    fn color_mask(&self, r: GLboolean, g: GLboolean, b: GLboolean, a: GLboolean) {
        self.log(GlCall::ColorMask([r, g, b, a]));
    }

    fn logic_op(&self, op: GLenum) {
        self.log(GlCall::LogicOp(op));
    }

    fn depth_func(&self, func: GLenum) {
        self.log(GlCall::DepthFunc(func));
    }

    fn depth_mask(&self, write: GLboolean) {
        self.log(GlCall::DepthMask(write));
    }

    fn stencil_func_separate(&self, face: GLenum, func: GLenum, reference: GLint, mask: GLuint) {
        self.log(GlCall::StencilFuncSeparate {
            face,
            func,
            reference,
            mask,
        });
    }

    fn stencil_op_separate(&self, face: GLenum, sfail: GLenum, dpfail: GLenum, dppass: GLenum) {
        self.log(GlCall::StencilOpSeparate {
            face,
            sfail,
            dpfail,
            dppass,
        });
    }

    fn stencil_mask_separate(&self, face: GLenum, mask: GLuint) {
        self.log(GlCall::StencilMaskSeparate { face, mask });
    }

    fn min_sample_shading(&self, value: GLfloat) {
        self.log(GlCall::MinSampleShading(value));
    }

    fn patch_parameter_i(&self, pname: GLenum, value: GLint) {
        self.log(GlCall::PatchParameteri { pname, value });
    }

    fn bind_vertex_array(&self, array: GLuint) {
        self.log(GlCall::BindVertexArray(array));
    }

    fn enable_vertex_attrib_array(&self, index: GLuint) {
        self.log(GlCall::EnableVertexAttribArray(index));
    }

    fn disable_vertex_attrib_array(&self, index: GLuint) {
        self.log(GlCall::DisableVertexAttribArray(index));
    }

    fn vertex_attrib_pointer(
        &self,
        index: GLuint,
        size: GLint,
        ty: GLenum,
        normalized: GLboolean,
        stride: GLsizei,
        offset: GLintptr,
    ) {
        self.log(GlCall::VertexAttribPointer {
            index,
            size,
            ty,
            normalized,
            stride,
            offset,
        });
    }

    fn vertex_attrib_i_pointer(
        &self,
        index: GLuint,
        size: GLint,
        ty: GLenum,
        stride: GLsizei,
        offset: GLintptr,
    ) {
        self.log(GlCall::VertexAttribIPointer {
            index,
            size,
            ty,
            stride,
            offset,
        });
    }

    fn vertex_attrib_divisor(&self, index: GLuint, divisor: GLuint) {
        self.log(GlCall::VertexAttribDivisor { index, divisor });
    }

    fn draw_arrays_instanced(&self, mode: GLenum, first: GLint, count: GLsizei, instances: GLsizei) {
        self.log(GlCall::DrawArraysInstanced {
            mode,
            first,
            count,
            instances,
        });
    }

    fn draw_arrays_instanced_base_instance(
        &self,
        mode: GLenum,
        first: GLint,
        count: GLsizei,
        instances: GLsizei,
        base_instance: GLuint,
    ) {
        self.log(GlCall::DrawArraysInstancedBaseInstance {
            mode,
            first,
            count,
            instances,
            base_instance,
        });
    }

    fn draw_elements_instanced_base_vertex(
        &self,
        mode: GLenum,
        count: GLsizei,
        ty: GLenum,
        offset: GLintptr,
        instances: GLsizei,
        base_vertex: GLint,
    ) {
        self.log(GlCall::DrawElementsInstancedBaseVertex {
            mode,
            count,
            ty,
            offset,
            instances,
            base_vertex,
        });
    }

    fn draw_elements_instanced_base_vertex_base_instance(
        &self,
        mode: GLenum,
        count: GLsizei,
        ty: GLenum,
        offset: GLintptr,
        instances: GLsizei,
        base_vertex: GLint,
        base_instance: GLuint,
    ) {
        self.log(GlCall::DrawElementsInstancedBaseVertexBaseInstance {
            mode,
            count,
            ty,
            offset,
            instances,
            base_vertex,
            base_instance,
        });
    }

    fn multi_draw_arrays_indirect(&self, mode: GLenum, offset: GLintptr, draw_count: GLsizei, stride: GLsizei) {
        self.log(GlCall::MultiDrawArraysIndirect {
            mode,
            offset,
            draw_count,
            stride,
        });
    }

    fn multi_draw_elements_indirect(
        &self,
        mode: GLenum,
        ty: GLenum,
        offset: GLintptr,
        draw_count: GLsizei,
        stride: GLsizei,
    ) {
        self.log(GlCall::MultiDrawElementsIndirect {
            mode,
            ty,
            offset,
            draw_count,
            stride,
        });
    }

    fn dispatch_compute(&self, x: GLuint, y: GLuint, z: GLuint) {
        self.log(GlCall::DispatchCompute { x, y, z });
    }

    fn dispatch_compute_indirect(&self, offset: GLintptr) {
        self.log(GlCall::DispatchComputeIndirect(offset));
    }

    fn memory_barrier(&self, barriers: GLbitfield) {
        self.log(GlCall::MemoryBarrier(barriers));
    }

    fn begin_query(&self, target: GLenum, query: GLuint) {
        self.log(GlCall::BeginQuery { target, query });
    }

    fn end_query(&self, target: GLenum) {
        self.log(GlCall::EndQuery(target));
    }

    fn query_counter(&self, query: GLuint, target: GLenum) {
        self.log(GlCall::QueryCounter { query, target });
    }

    fn fence_sync(&self) -> GLsync {
        let mut state = self.state.lock();
        state.next_sync += 1;
        let sync = state.next_sync;
        state.calls.push(GlCall::FenceSync(sync));
        sync
    }

    fn client_wait_sync(&self, _sync: GLsync, _flags: GLbitfield, _timeout_ns: u64) -> GLenum {
        if self.state.lock().context_lost {
            GL_WAIT_FAILED
        } else {
            GL_ALREADY_SIGNALED
        }
    }

    fn delete_sync(&self, sync: GLsync) {
        self.log(GlCall::DeleteSync(sync));
    }

    fn flush(&self) {
        self.log(GlCall::Flush);
    }

    fn finish(&self) {
        self.log(GlCall::Finish);
    }
}

// ============================================================================
// Headless platform context
// ============================================================================

#[derive(Debug, Default)]
struct HeadlessCounters {
    make_current: AtomicUsize,
    release_current: AtomicUsize,
    swap_buffers: AtomicUsize,
    lost: AtomicBool,
}

/// A platform context that owns no native surface.
///
/// Cloning yields another handle on the same counters.
#[derive(Debug, Clone, Default)]
pub struct HeadlessPlatform {
    counters: Arc<HeadlessCounters>,
}

impl HeadlessPlatform {
    /// Create a new headless platform context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later `make_current` fail.
    pub fn lose(&self) {
        self.counters.lost.store(true, Ordering::Release);
    }

    /// Number of successful `make_current` calls.
    pub fn make_current_count(&self) -> usize {
        self.counters.make_current.load(Ordering::Acquire)
    }

    /// Number of `release_current` calls.
    pub fn release_current_count(&self) -> usize {
        self.counters.release_current.load(Ordering::Acquire)
    }

    /// Number of `swap_buffers` calls.
    pub fn swap_count(&self) -> usize {
        self.counters.swap_buffers.load(Ordering::Acquire)
    }
}

impl PlatformContext for HeadlessPlatform {
    fn make_current(&self) -> Result<(), GraphicsError> {
        if self.counters.lost.load(Ordering::Acquire) {
            return Err(GraphicsError::DeviceLost);
        }
        self.counters.make_current.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn release_current(&self) {
        self.counters.release_current.fetch_add(1, Ordering::AcqRel);
    }

    fn swap_buffers(&self) -> Result<(), GraphicsError> {
        if self.counters.lost.load(Ordering::Acquire) {
            return Err(GraphicsError::DeviceLost);
        }
        self.counters.swap_buffers.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_unique_and_logged() {
        let gl = RecordingGl::new();
        let a = gl.gen_buffer();
        let b = gl.gen_texture();
        assert_ne!(a, b);
        assert_eq!(gl.calls(), vec![GlCall::GenBuffer(a), GlCall::GenTexture(b)]);
    }

    #[test]
    fn test_queries_are_not_logged() {
        let gl = RecordingGl::with_version("3.3.0");
        assert_eq!(gl.get_string(GL_VERSION), "3.3.0");
        assert_eq!(gl.get_error(), GL_NO_ERROR);
        assert!(gl.calls().is_empty());
    }

    #[test]
    fn test_shadowed_buffer_copy() {
        let gl = RecordingGl::new();
        let src = gl.gen_buffer();
        let dst = gl.gen_buffer();
        gl.bind_buffer(GL_COPY_WRITE_BUFFER, src);
        gl.buffer_data_size(GL_COPY_WRITE_BUFFER, 8, GL_STATIC_DRAW);
        gl.buffer_sub_data(GL_COPY_WRITE_BUFFER, 0, &[1, 2, 3, 4, 5, 6, 7, 8]);
        gl.bind_buffer(GL_COPY_WRITE_BUFFER, dst);
        gl.buffer_data_size(GL_COPY_WRITE_BUFFER, 8, GL_STATIC_DRAW);
        gl.bind_buffer(GL_COPY_READ_BUFFER, src);
        gl.copy_buffer_sub_data(GL_COPY_READ_BUFFER, GL_COPY_WRITE_BUFFER, 2, 4, 4);
        assert_eq!(gl.buffer_contents(dst), Some(vec![0, 0, 0, 0, 3, 4, 5, 6]));
    }

    #[test]
    fn test_lost_context_reports_error() {
        let gl = RecordingGl::new();
        gl.push_error(GL_INVALID_ENUM);
        assert_eq!(gl.get_error(), GL_INVALID_ENUM);
        gl.lose_context();
        assert_eq!(gl.get_error(), GL_CONTEXT_LOST);
        assert_eq!(gl.get_error(), GL_CONTEXT_LOST);
    }

    #[test]
    fn test_headless_platform_loss() {
        let platform = HeadlessPlatform::new();
        assert!(platform.make_current().is_ok());
        platform.lose();
        assert_eq!(platform.make_current(), Err(GraphicsError::DeviceLost));
        assert_eq!(platform.make_current_count(), 1);
    }
}
