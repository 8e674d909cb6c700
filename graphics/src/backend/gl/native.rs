//! [`GlApi`] over a real driver, through `glow`.

use std::num::NonZeroU32;

use glow::HasContext;

use super::api::GlApi;
use super::constants::*;

/// GL entry points loaded by `glow`.
///
/// The caller creates the `glow::Context` from the platform's loader while
/// its native context is current.
pub struct GlowApi {
    gl: glow::Context,
}

// SAFETY: the backends only call into the context while holding its
// `ContextLock`, which serialises every thread and keeps the native context
// current for the duration of the call.
unsafe impl Send for GlowApi {}
unsafe impl Sync for GlowApi {}

impl GlowApi {
    pub fn new(gl: glow::Context) -> Self {
        Self { gl }
    }

    /// The wrapped `glow` context.
    pub fn raw(&self) -> &glow::Context {
        &self.gl
    }
}

impl std::fmt::Debug for GlowApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlowApi")
            .field("version", self.gl.version())
            .finish_non_exhaustive()
    }
}

fn handle<T>(name: GLuint, wrap: fn(NonZeroU32) -> T) -> Option<T> {
    NonZeroU32::new(name).map(wrap)
}

fn name_of<T>(created: Result<T, String>, what: &str, unwrap: fn(T) -> NonZeroU32) -> GLuint {
    match created {
        Ok(object) => unwrap(object).get(),
        Err(err) => {
            log::error!("GlowApi: failed to create {what}: {err}");
            0
        }
    }
}

fn location(location: GLint) -> Option<glow::NativeUniformLocation> {
    u32::try_from(location).ok().map(glow::NativeUniformLocation)
}

fn fence(sync: GLsync) -> glow::NativeFence {
    glow::NativeFence(sync as usize as _)
}

fn clamp_i32(value: isize) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

impl GlApi for GlowApi {
    fn get_error(&self) -> GLenum {
        unsafe { self.gl.get_error() }
    }

    fn get_string(&self, name: GLenum) -> String {
        unsafe { self.gl.get_parameter_string(name) }
    }

    fn check_framebuffer_status(&self, target: GLenum) -> GLenum {
        unsafe { self.gl.check_framebuffer_status(target) }
    }

    fn get_query_result(&self, query: GLuint) -> u64 {
        let Some(query) = handle(query, glow::NativeQuery) else {
            return 0;
        };
        unsafe { u64::from(self.gl.get_query_parameter_u32(query, glow::QUERY_RESULT)) }
    }

    fn get_query_result_available(&self, query: GLuint) -> bool {
        let Some(query) = handle(query, glow::NativeQuery) else {
            return false;
        };
        unsafe { self.gl.get_query_parameter_u32(query, glow::QUERY_RESULT_AVAILABLE) != 0 }
    }

    fn get_buffer_sub_data(&self, target: GLenum, offset: GLintptr, data: &mut [u8]) {
        unsafe { self.gl.get_buffer_sub_data(target, clamp_i32(offset), data) }
    }

    fn gen_buffer(&self) -> GLuint {
        name_of(unsafe { self.gl.create_buffer() }, "buffer", |b| b.0)
    }

    fn delete_buffer(&self, buffer: GLuint) {
        if let Some(buffer) = handle(buffer, glow::NativeBuffer) {
            unsafe { self.gl.delete_buffer(buffer) }
        }
    }

    fn gen_texture(&self) -> GLuint {
        name_of(unsafe { self.gl.create_texture() }, "texture", |t| t.0)
    }

    fn delete_texture(&self, texture: GLuint) {
        if let Some(texture) = handle(texture, glow::NativeTexture) {
            unsafe { self.gl.delete_texture(texture) }
        }
    }

    fn gen_sampler(&self) -> GLuint {
        name_of(unsafe { self.gl.create_sampler() }, "sampler", |s| s.0)
    }

    fn delete_sampler(&self, sampler: GLuint) {
        if let Some(sampler) = handle(sampler, glow::NativeSampler) {
            unsafe { self.gl.delete_sampler(sampler) }
        }
    }

    fn gen_framebuffer(&self) -> GLuint {
        name_of(unsafe { self.gl.create_framebuffer() }, "framebuffer", |f| f.0)
    }

    fn delete_framebuffer(&self, framebuffer: GLuint) {
        if let Some(framebuffer) = handle(framebuffer, glow::NativeFramebuffer) {
            unsafe { self.gl.delete_framebuffer(framebuffer) }
        }
    }

    fn gen_vertex_array(&self) -> GLuint {
        name_of(unsafe { self.gl.create_vertex_array() }, "vertex array", |v| v.0)
    }

    fn delete_vertex_array(&self, array: GLuint) {
        if let Some(array) = handle(array, glow::NativeVertexArray) {
            unsafe { self.gl.delete_vertex_array(array) }
        }
    }

    fn gen_query(&self) -> GLuint {
        name_of(unsafe { self.gl.create_query() }, "query", |q| q.0)
    }

    fn delete_query(&self, query: GLuint) {
        if let Some(query) = handle(query, glow::NativeQuery) {
            unsafe { self.gl.delete_query(query) }
        }
    }

    fn bind_buffer(&self, target: GLenum, buffer: GLuint) {
        unsafe { self.gl.bind_buffer(target, handle(buffer, glow::NativeBuffer)) }
    }

    fn bind_buffer_range(
        &self,
        target: GLenum,
        index: GLuint,
        buffer: GLuint,
        offset: GLintptr,
        size: GLsizeiptr,
    ) {
        unsafe {
            self.gl.bind_buffer_range(
                target,
                index,
                handle(buffer, glow::NativeBuffer),
                clamp_i32(offset),
                clamp_i32(size),
            )
        }
    }

    fn buffer_data_size(&self, target: GLenum, size: GLsizeiptr, usage: GLenum) {
        unsafe { self.gl.buffer_data_size(target, clamp_i32(size), usage) }
    }

    fn buffer_sub_data(&self, target: GLenum, offset: GLintptr, data: &[u8]) {
        unsafe { self.gl.buffer_sub_data_u8_slice(target, clamp_i32(offset), data) }
    }

    fn copy_buffer_sub_data(
        &self,
        read_target: GLenum,
        write_target: GLenum,
        read_offset: GLintptr,
        write_offset: GLintptr,
        size: GLsizeiptr,
    ) {
        unsafe {
            self.gl.copy_buffer_sub_data(
                read_target,
                write_target,
                clamp_i32(read_offset),
                clamp_i32(write_offset),
                clamp_i32(size),
            )
        }
    }

    fn active_texture(&self, unit: GLenum) {
        unsafe { self.gl.active_texture(unit) }
    }

    fn bind_texture(&self, target: GLenum, texture: GLuint) {
        unsafe { self.gl.bind_texture(target, handle(texture, glow::NativeTexture)) }
    }

    fn tex_storage_2d(
        &self,
        target: GLenum,
        levels: GLsizei,
        internal_format: GLenum,
        width: GLsizei,
        height: GLsizei,
    ) {
        unsafe { self.gl.tex_storage_2d(target, levels, internal_format, width, height) }
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
        unsafe {
            self.gl
                .tex_storage_3d(target, levels, internal_format, width, height, depth)
        }
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
        unsafe {
            self.gl.tex_image_2d(
                target,
                level,
                internal_format as i32,
                width,
                height,
                0,
                format,
                ty,
                None,
            )
        }
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
        unsafe {
            self.gl.tex_image_3d(
                target,
                level,
                internal_format as i32,
                width,
                height,
                depth,
                0,
                format,
                ty,
                None,
            )
        }
    }

    fn tex_image_2d_multisample(
        &self,
        target: GLenum,
        samples: GLsizei,
        internal_format: GLenum,
        width: GLsizei,
        height: GLsizei,
    ) {
        unsafe {
            self.gl.tex_image_2d_multisample(
                target,
                samples,
                internal_format as i32,
                width,
                height,
                true,
            )
        }
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
        unsafe {
            self.gl.tex_sub_image_2d(
                target,
                level,
                x,
                y,
                width,
                height,
                format,
                ty,
                glow::PixelUnpackData::BufferOffset(offset as u32),
            )
        }
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
        unsafe {
            self.gl.tex_sub_image_3d(
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
                glow::PixelUnpackData::BufferOffset(offset as u32),
            )
        }
    }

    fn tex_parameter_i(&self, target: GLenum, pname: GLenum, value: GLint) {
        unsafe { self.gl.tex_parameter_i32(target, pname, value) }
    }

    fn pixel_store_i(&self, pname: GLenum, value: GLint) {
        unsafe { self.gl.pixel_store_i32(pname, value) }
    }

    fn bind_sampler(&self, unit: GLuint, sampler: GLuint) {
        unsafe { self.gl.bind_sampler(unit, handle(sampler, glow::NativeSampler)) }
    }

    fn sampler_parameter_i(&self, sampler: GLuint, pname: GLenum, value: GLint) {
        if let Some(sampler) = handle(sampler, glow::NativeSampler) {
            unsafe { self.gl.sampler_parameter_i32(sampler, pname, value) }
        }
    }

    fn sampler_parameter_f(&self, sampler: GLuint, pname: GLenum, value: GLfloat) {
        if let Some(sampler) = handle(sampler, glow::NativeSampler) {
            unsafe { self.gl.sampler_parameter_f32(sampler, pname, value) }
        }
    }

    fn sampler_parameter_fv(&self, sampler: GLuint, pname: GLenum, values: &[GLfloat]) {
        if let Some(sampler) = handle(sampler, glow::NativeSampler) {
            let mut values = values.to_vec();
            unsafe { self.gl.sampler_parameter_f32_slice(sampler, pname, &mut values) }
        }
    }

    fn bind_framebuffer(&self, target: GLenum, framebuffer: GLuint) {
        unsafe {
            self.gl
                .bind_framebuffer(target, handle(framebuffer, glow::NativeFramebuffer))
        }
    }

    fn framebuffer_texture_2d(
        &self,
        target: GLenum,
        attachment: GLenum,
        texture_target: GLenum,
        texture: GLuint,
        level: GLint,
    ) {
        unsafe {
            self.gl.framebuffer_texture_2d(
                target,
                attachment,
                texture_target,
                handle(texture, glow::NativeTexture),
                level,
            )
        }
    }

    fn framebuffer_texture_layer(
        &self,
        target: GLenum,
        attachment: GLenum,
        texture: GLuint,
        level: GLint,
        layer: GLint,
    ) {
        unsafe {
            self.gl.framebuffer_texture_layer(
                target,
                attachment,
                handle(texture, glow::NativeTexture),
                level,
                layer,
            )
        }
    }

    fn draw_buffers(&self, buffers: &[GLenum]) {
        unsafe { self.gl.draw_buffers(buffers) }
    }

    fn read_buffer(&self, source: GLenum) {
        unsafe { self.gl.read_buffer(source) }
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
        unsafe {
            self.gl.blit_framebuffer(
                src_x0, src_y0, src_x1, src_y1, dst_x0, dst_y0, dst_x1, dst_y1, mask, filter,
            )
        }
    }

    fn clear_buffer_fv(&self, buffer: GLenum, draw_buffer: GLint, values: &[GLfloat]) {
        unsafe { self.gl.clear_buffer_f32_slice(buffer, draw_buffer as u32, values) }
    }

    fn clear_buffer_iv(&self, buffer: GLenum, draw_buffer: GLint, values: &[GLint]) {
        unsafe { self.gl.clear_buffer_i32_slice(buffer, draw_buffer as u32, values) }
    }

    fn clear_buffer_uiv(&self, buffer: GLenum, draw_buffer: GLint, values: &[GLuint]) {
        unsafe { self.gl.clear_buffer_u32_slice(buffer, draw_buffer as u32, values) }
    }

    fn clear_buffer_fi(&self, buffer: GLenum, draw_buffer: GLint, depth: GLfloat, stencil: GLint) {
        unsafe {
            self.gl
                .clear_buffer_depth_stencil(buffer, draw_buffer as u32, depth, stencil)
        }
    }

    fn create_shader(&self, kind: GLenum) -> GLuint {
        name_of(unsafe { self.gl.create_shader(kind) }, "shader", |s| s.0)
    }

    fn compile_shader(&self, shader: GLuint, source: &str) -> Result<(), String> {
        let shader = handle(shader, glow::NativeShader).ok_or("shader 0")?;
        unsafe {
            self.gl.shader_source(shader, source);
            self.gl.compile_shader(shader);
            if self.gl.get_shader_compile_status(shader) {
                Ok(())
            } else {
                Err(self.gl.get_shader_info_log(shader))
            }
        }
    }

    fn delete_shader(&self, shader: GLuint) {
        if let Some(shader) = handle(shader, glow::NativeShader) {
            unsafe { self.gl.delete_shader(shader) }
        }
    }

    fn create_program(&self) -> GLuint {
        name_of(unsafe { self.gl.create_program() }, "program", |p| p.0)
    }

    fn attach_shader(&self, program: GLuint, shader: GLuint) {
        if let (Some(program), Some(shader)) = (
            handle(program, glow::NativeProgram),
            handle(shader, glow::NativeShader),
        ) {
            unsafe { self.gl.attach_shader(program, shader) }
        }
    }

    fn detach_shader(&self, program: GLuint, shader: GLuint) {
        if let (Some(program), Some(shader)) = (
            handle(program, glow::NativeProgram),
            handle(shader, glow::NativeShader),
        ) {
            unsafe { self.gl.detach_shader(program, shader) }
        }
    }

    fn link_program(&self, program: GLuint) -> Result<(), String> {
        let program = handle(program, glow::NativeProgram).ok_or("program 0")?;
        unsafe {
            self.gl.link_program(program);
            if self.gl.get_program_link_status(program) {
                Ok(())
            } else {
                Err(self.gl.get_program_info_log(program))
            }
        }
    }

    fn delete_program(&self, program: GLuint) {
        if let Some(program) = handle(program, glow::NativeProgram) {
            unsafe { self.gl.delete_program(program) }
        }
    }

    fn use_program(&self, program: GLuint) {
        unsafe { self.gl.use_program(handle(program, glow::NativeProgram)) }
    }

    fn uniform_1fv(&self, location: GLint, values: &[GLfloat]) {
        unsafe { self.gl.uniform_1_f32_slice(location(location).as_ref(), values) }
    }

    fn uniform_2fv(&self, location: GLint, values: &[GLfloat]) {
        unsafe { self.gl.uniform_2_f32_slice(location(location).as_ref(), values) }
    }

    fn uniform_3fv(&self, location: GLint, values: &[GLfloat]) {
        unsafe { self.gl.uniform_3_f32_slice(location(location).as_ref(), values) }
    }

    fn uniform_4fv(&self, location: GLint, values: &[GLfloat]) {
        unsafe { self.gl.uniform_4_f32_slice(location(location).as_ref(), values) }
    }

    fn uniform_matrix_2fv(&self, location: GLint, transpose: GLboolean, values: &[GLfloat]) {
        unsafe {
            self.gl
                .uniform_matrix_2_f32_slice(location(location).as_ref(), transpose, values)
        }
    }

    fn uniform_matrix_3fv(&self, location: GLint, transpose: GLboolean, values: &[GLfloat]) {
        unsafe {
            self.gl
                .uniform_matrix_3_f32_slice(location(location).as_ref(), transpose, values)
        }
    }

    fn uniform_matrix_4fv(&self, location: GLint, transpose: GLboolean, values: &[GLfloat]) {
        unsafe {
            self.gl
                .uniform_matrix_4_f32_slice(location(location).as_ref(), transpose, values)
        }
    }

    fn uniform_1iv(&self, location: GLint, values: &[GLint]) {
        unsafe { self.gl.uniform_1_i32_slice(location(location).as_ref(), values) }
    }

    fn uniform_2iv(&self, location: GLint, values: &[GLint]) {
        unsafe { self.gl.uniform_2_i32_slice(location(location).as_ref(), values) }
    }

    fn uniform_3iv(&self, location: GLint, values: &[GLint]) {
        unsafe { self.gl.uniform_3_i32_slice(location(location).as_ref(), values) }
    }

    fn uniform_4iv(&self, location: GLint, values: &[GLint]) {
        unsafe { self.gl.uniform_4_i32_slice(location(location).as_ref(), values) }
    }

    fn uniform_1uiv(&self, location: GLint, values: &[GLuint]) {
        unsafe { self.gl.uniform_1_u32_slice(location(location).as_ref(), values) }
    }

    fn uniform_2uiv(&self, location: GLint, values: &[GLuint]) {
        unsafe { self.gl.uniform_2_u32_slice(location(location).as_ref(), values) }
    }

    fn uniform_3uiv(&self, location: GLint, values: &[GLuint]) {
        unsafe { self.gl.uniform_3_u32_slice(location(location).as_ref(), values) }
    }

    fn uniform_4uiv(&self, location: GLint, values: &[GLuint]) {
        unsafe { self.gl.uniform_4_u32_slice(location(location).as_ref(), values) }
    }

    fn enable(&self, cap: GLenum) {
        unsafe { self.gl.enable(cap) }
    }

    fn disable(&self, cap: GLenum) {
        unsafe { self.gl.disable(cap) }
    }

    fn viewport(&self, x: GLint, y: GLint, width: GLsizei, height: GLsizei) {
        unsafe { self.gl.viewport(x, y, width, height) }
    }

    fn depth_range(&self, near: f64, far: f64) {
        unsafe { self.gl.depth_range_f64(near, far) }
    }

    fn scissor(&self, x: GLint, y: GLint, width: GLsizei, height: GLsizei) {
        unsafe { self.gl.scissor(x, y, width, height) }
    }

    fn line_width(&self, width: GLfloat) {
        unsafe { self.gl.line_width(width) }
    }

    fn polygon_offset(&self, factor: GLfloat, units: GLfloat) {
        unsafe { self.gl.polygon_offset(factor, units) }
    }

    /// `glow` has no `glPolygonOffsetClamp`; the clamp is dropped.
    fn polygon_offset_clamp(&self, factor: GLfloat, units: GLfloat, clamp: GLfloat) {
        if clamp != 0.0 {
            log::trace!("GlowApi: depth bias clamp {clamp} dropped");
        }
        unsafe { self.gl.polygon_offset(factor, units) }
    }

    fn polygon_mode(&self, face: GLenum, mode: GLenum) {
        unsafe { self.gl.polygon_mode(face, mode) }
    }

    fn cull_face(&self, mode: GLenum) {
        unsafe { self.gl.cull_face(mode) }
    }

    fn front_face(&self, mode: GLenum) {
        unsafe { self.gl.front_face(mode) }
    }

    fn blend_color(&self, r: GLfloat, g: GLfloat, b: GLfloat, a: GLfloat) {
        unsafe { self.gl.blend_color(r, g, b, a) }
    }

    fn blend_func_separate(&self, src_rgb: GLenum, dst_rgb: GLenum, src_alpha: GLenum, dst_alpha: GLenum) {
        unsafe {
            self.gl
                .blend_func_separate(src_rgb, dst_rgb, src_alpha, dst_alpha)
        }
    }

    fn blend_equation_separate(&self, mode_rgb: GLenum, mode_alpha: GLenum) {
        unsafe { self.gl.blend_equation_separate(mode_rgb, mode_alpha) }
    }

    fn color_mask(&self, r: GLboolean, g: GLboolean, b: GLboolean, a: GLboolean) {
        unsafe { self.gl.color_mask(r, g, b, a) }
    }

    /// `glow` has no `glLogicOp`; logic ops are ignored on native contexts.
    fn logic_op(&self, op: GLenum) {
        log::warn!("GlowApi: glLogicOp({op:#x}) is not available");
    }

    fn depth_func(&self, func: GLenum) {
        unsafe { self.gl.depth_func(func) }
    }

    fn depth_mask(&self, write: GLboolean) {
        unsafe { self.gl.depth_mask(write) }
    }

    fn stencil_func_separate(&self, face: GLenum, func: GLenum, reference: GLint, mask: GLuint) {
        unsafe { self.gl.stencil_func_separate(face, func, reference, mask) }
    }

    fn stencil_op_separate(&self, face: GLenum, sfail: GLenum, dpfail: GLenum, dppass: GLenum) {
        unsafe { self.gl.stencil_op_separate(face, sfail, dpfail, dppass) }
    }

    fn stencil_mask_separate(&self, face: GLenum, mask: GLuint) {
        unsafe { self.gl.stencil_mask_separate(face, mask) }
    }

    /// `glow` has no `glMinSampleShading`; the driver default applies.
    fn min_sample_shading(&self, value: GLfloat) {
        log::trace!("GlowApi: min sample shading {value} left to the driver");
    }

    fn patch_parameter_i(&self, pname: GLenum, value: GLint) {
        unsafe { self.gl.patch_parameter_i32(pname, value) }
    }

    fn bind_vertex_array(&self, array: GLuint) {
        unsafe {
            self.gl
                .bind_vertex_array(handle(array, glow::NativeVertexArray))
        }
    }

    fn enable_vertex_attrib_array(&self, index: GLuint) {
        unsafe { self.gl.enable_vertex_attrib_array(index) }
    }

    fn disable_vertex_attrib_array(&self, index: GLuint) {
        unsafe { self.gl.disable_vertex_attrib_array(index) }
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
        unsafe {
            self.gl
                .vertex_attrib_pointer_f32(index, size, ty, normalized, stride, clamp_i32(offset))
        }
    }

    fn vertex_attrib_i_pointer(
        &self,
        index: GLuint,
        size: GLint,
        ty: GLenum,
        stride: GLsizei,
        offset: GLintptr,
    ) {
        unsafe {
            self.gl
                .vertex_attrib_pointer_i32(index, size, ty, stride, clamp_i32(offset))
        }
    }

    fn vertex_attrib_divisor(&self, index: GLuint, divisor: GLuint) {
        unsafe { self.gl.vertex_attrib_divisor(index, divisor) }
    }

    fn draw_arrays_instanced(&self, mode: GLenum, first: GLint, count: GLsizei, instances: GLsizei) {
        unsafe { self.gl.draw_arrays_instanced(mode, first, count, instances) }
    }

    fn draw_arrays_instanced_base_instance(
        &self,
        mode: GLenum,
        first: GLint,
        count: GLsizei,
        instances: GLsizei,
        base_instance: GLuint,
    ) {
        unsafe {
            self.gl
                .draw_arrays_instanced_base_instance(mode, first, count, instances, base_instance)
        }
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
        unsafe {
            self.gl.draw_elements_instanced_base_vertex(
                mode,
                count,
                ty,
                clamp_i32(offset),
                instances,
                base_vertex,
            )
        }
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
        unsafe {
            self.gl.draw_elements_instanced_base_vertex_base_instance(
                mode,
                count,
                ty,
                clamp_i32(offset),
                instances,
                base_vertex,
                base_instance,
            )
        }
    }

    fn multi_draw_arrays_indirect(&self, mode: GLenum, offset: GLintptr, draw_count: GLsizei, stride: GLsizei) {
        unsafe {
            self.gl
                .multi_draw_arrays_indirect_offset(mode, clamp_i32(offset), draw_count, stride)
        }
    }

    fn multi_draw_elements_indirect(
        &self,
        mode: GLenum,
        ty: GLenum,
        offset: GLintptr,
        draw_count: GLsizei,
        stride: GLsizei,
    ) {
        unsafe {
            self.gl
                .multi_draw_elements_indirect_offset(mode, ty, clamp_i32(offset), draw_count, stride)
        }
    }

    fn dispatch_compute(&self, x: GLuint, y: GLuint, z: GLuint) {
        unsafe { self.gl.dispatch_compute(x, y, z) }
    }

    fn dispatch_compute_indirect(&self, offset: GLintptr) {
        unsafe { self.gl.dispatch_compute_indirect(clamp_i32(offset)) }
    }

    fn memory_barrier(&self, barriers: GLbitfield) {
        unsafe { self.gl.memory_barrier(barriers) }
    }

    fn begin_query(&self, target: GLenum, query: GLuint) {
        if let Some(query) = handle(query, glow::NativeQuery) {
            unsafe { self.gl.begin_query(target, query) }
        }
    }

    fn end_query(&self, target: GLenum) {
        unsafe { self.gl.end_query(target) }
    }

    fn query_counter(&self, query: GLuint, target: GLenum) {
        if let Some(query) = handle(query, glow::NativeQuery) {
            unsafe { self.gl.query_counter(query, target) }
        }
    }

    fn fence_sync(&self) -> GLsync {
        match unsafe { self.gl.fence_sync(GL_SYNC_GPU_COMMANDS_COMPLETE, 0) } {
            Ok(sync) => sync.0 as usize as GLsync,
            Err(err) => {
                log::error!("GlowApi: glFenceSync failed: {err}");
                0
            }
        }
    }

    fn client_wait_sync(&self, sync: GLsync, flags: GLbitfield, timeout_ns: u64) -> GLenum {
        let timeout = i32::try_from(timeout_ns).unwrap_or(i32::MAX);
        unsafe { self.gl.client_wait_sync(fence(sync), flags, timeout) }
    }

    fn delete_sync(&self, sync: GLsync) {
        unsafe { self.gl.delete_sync(fence(sync)) }
    }

    fn flush(&self) {
        unsafe { self.gl.flush() }
    }

    fn finish(&self) {
        unsafe { self.gl.finish() }
    }
}
