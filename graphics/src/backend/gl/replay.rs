//! Replay of recorded command lists against a GL context.
//!
//! A [`ReplayState`] lives for one command list of one submission. It carries
//! the state Vulkan defines as inherited between commands (bound pipelines,
//! vertex and index buffers, the current render pass and subpass, the dynamic
//! scissor and stencil values) and translates every [`Operation`] into the GL
//! calls it needs. Misuse that recording cannot catch (drawing without a
//! pipeline, an operation the profile lacks) panics.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use super::api::{check_errors, GlApi};
use super::constants::*;
use super::conversion::*;
use super::{attach_texture, GlBackend, GlProfile};
use crate::backend::GpuQueryPool;
use crate::command::{CommandList, Operation};
use crate::resources::{
    Buffer, DescriptorResource, DescriptorSet, Framebuffer, Image, Pipeline, PipelineLayout,
    QueryPool, RenderPass,
};
use crate::types::{
    stencil_faces, AccessFlags, AttachmentLoadOp, BufferCopy, BufferImageCopy, ClearAttachment,
    ClearColourValue, ClearRect, ClearValue, ColourComponentFlags, ConstantFormat, DescriptorType,
    DynamicStateFlags, Format, ImageAspectFlags, ImageCopy, ImageSubresourceRange, IndexType,
    PipelineBindPoint, PushConstantsDesc, Rect2d, StencilFaceFlags, StencilOpState,
    VertexInputRate, Viewport,
};

/// Texture unit used for uploads, so descriptor bindings stay intact.
///
/// 47 is the last unit every 3.3 context guarantees.
const UPLOAD_TEXTURE_UNIT: GLenum = 47;

/// Replay state of one command list.
pub(crate) struct ReplayState<'a> {
    backend: &'a GlBackend,
    gl: &'a dyn GlApi,
    program: GLuint,
    graphics_pipeline: Option<&'a Pipeline>,
    compute_pipeline: Option<&'a Pipeline>,
    vertex_buffers: BTreeMap<u32, (&'a Buffer, u64)>,
    index_buffer: Option<(&'a Buffer, u64, IndexType)>,
    /// Attribute pointers must be respecified before the next draw.
    vertex_dirty: bool,
    render_pass: Option<(&'a RenderPass, &'a Framebuffer)>,
    subpass: u32,
    scissor: Option<Rect2d>,
    /// Front and back stencil state, including dynamic overrides.
    stencil: [StencilOpState; 2],
    executed: u64,
}

impl<'a> ReplayState<'a> {
    pub(crate) fn new(backend: &'a GlBackend, gl: &'a dyn GlApi) -> Self {
        Self {
            backend,
            gl,
            program: 0,
            graphics_pipeline: None,
            compute_pipeline: None,
            vertex_buffers: BTreeMap::new(),
            index_buffer: None,
            vertex_dirty: true,
            render_pass: None,
            subpass: 0,
            scissor: None,
            stencil: [StencilOpState::default(); 2],
            executed: 0,
        }
    }

    /// Applies every operation of `list` in record order.
    pub(crate) fn execute(&mut self, list: &'a CommandList) {
        for operation in list {
            log::trace!("GL replay: {}", operation.name());
            self.executed += 1;
            self.apply(operation);
            if self.backend.validation {
                check_errors(self.gl, operation.name());
            }
        }
    }

    /// Number of operations applied, nested secondaries included.
    pub(crate) fn finish(self) -> u64 {
        if self.render_pass.is_some() {
            log::warn!("GL replay: command list ended inside a render pass");
        }
        self.executed
    }

    fn apply(&mut self, operation: &'a Operation) {
        let gl = self.gl;
        match operation {
            Operation::BeginRenderPass {
                render_pass,
                framebuffer,
                render_area,
                clear_values,
                ..
            } => self.begin_render_pass(render_pass, framebuffer, *render_area, clear_values),
            Operation::NextSubpass { .. } => {
                let Some((render_pass, _)) = self.render_pass else {
                    panic!("NextSubpass outside a render pass");
                };
                self.subpass += 1;
                assert!(
                    self.subpass < render_pass.subpass_count(),
                    "render pass has no subpass {}",
                    self.subpass
                );
                self.apply_subpass_draw_buffers();
            }
            Operation::EndRenderPass => {
                gl.bind_framebuffer(GL_DRAW_FRAMEBUFFER, 0);
                gl.disable(GL_SCISSOR_TEST);
                self.scissor = None;
                self.render_pass = None;
                self.subpass = 0;
            }
            Operation::BindPipeline { pipeline } => match pipeline.bind_point() {
                PipelineBindPoint::Graphics => self.bind_graphics_pipeline(pipeline),
                PipelineBindPoint::Compute => {
                    self.use_program(pipeline.gpu.gl_program());
                    self.compute_pipeline = Some(&**pipeline);
                }
            },
            Operation::BindVertexBuffers {
                first_binding,
                buffers,
            } => {
                for (binding, (buffer, offset)) in (*first_binding..).zip(buffers) {
                    self.vertex_buffers.insert(binding, (&**buffer, *offset));
                }
                self.vertex_dirty = true;
            }
            Operation::BindIndexBuffer {
                buffer,
                offset,
                index_type,
            } => {
                self.index_buffer = Some((&**buffer, *offset, *index_type));
                self.vertex_dirty = true;
            }
            Operation::BindDescriptorSets {
                layout,
                first_set,
                sets,
                dynamic_offsets,
                ..
            } => self.bind_descriptor_sets(layout, *first_set, sets, dynamic_offsets),
            Operation::SetViewport(viewport) => self.set_viewport(viewport),
            Operation::SetScissor(rect) => self.set_scissor(*rect),
            Operation::SetLineWidth(width) => gl.line_width(*width),
            Operation::SetDepthBias {
                constant_factor,
                clamp,
                slope_factor,
            } => self.set_depth_bias(*constant_factor, *clamp, *slope_factor),
            Operation::SetBlendConstants([r, g, b, a]) => gl.blend_color(*r, *g, *b, *a),
            Operation::SetStencilReference { faces, reference } => {
                self.update_stencil(*faces, |state| state.reference = *reference);
                self.apply_stencil_func(*faces);
            }
            Operation::SetStencilCompareMask { faces, mask } => {
                self.update_stencil(*faces, |state| state.compare_mask = *mask);
                self.apply_stencil_func(*faces);
            }
            Operation::SetStencilWriteMask { faces, mask } => {
                self.update_stencil(*faces, |state| state.write_mask = *mask);
                self.apply_stencil_write_mask(*faces);
            }
            Operation::Draw {
                vertex_count,
                instance_count,
                first_vertex,
                first_instance,
            } => {
                let mode = self.prepare_draw();
                let (first, count, instances) = (
                    *first_vertex as GLint,
                    *vertex_count as GLsizei,
                    *instance_count as GLsizei,
                );
                if *first_instance == 0 {
                    gl.draw_arrays_instanced(mode, first, count, instances);
                } else {
                    assert!(
                        self.backend.capabilities.base_instance,
                        "a non-zero first instance is unsupported on this backend"
                    );
                    gl.draw_arrays_instanced_base_instance(mode, first, count, instances, *first_instance);
                }
            }
            Operation::DrawIndexed {
                index_count,
                instance_count,
                first_index,
                vertex_offset,
                first_instance,
            } => {
                let mode = self.prepare_draw();
                let Some((_, offset, index_type)) = self.index_buffer else {
                    panic!("indexed draw without a bound index buffer");
                };
                let offset = (offset + u64::from(*first_index) * index_type.size()) as GLintptr;
                let ty = convert_index_type(index_type);
                let (count, instances) = (*index_count as GLsizei, *instance_count as GLsizei);
                if *first_instance == 0 {
                    gl.draw_elements_instanced_base_vertex(mode, count, ty, offset, instances, *vertex_offset);
                } else {
                    assert!(
                        self.backend.capabilities.base_instance,
                        "a non-zero first instance is unsupported on this backend"
                    );
                    gl.draw_elements_instanced_base_vertex_base_instance(
                        mode,
                        count,
                        ty,
                        offset,
                        instances,
                        *vertex_offset,
                        *first_instance,
                    );
                }
            }
            Operation::DrawIndirect {
                buffer,
                offset,
                draw_count,
                stride,
            } => {
                assert!(
                    self.backend.capabilities.indirect_draw,
                    "indirect draws are unsupported on this backend"
                );
                let mode = self.prepare_draw();
                gl.bind_buffer(GL_DRAW_INDIRECT_BUFFER, buffer.gpu.gl_name());
                gl.multi_draw_arrays_indirect(
                    mode,
                    *offset as GLintptr,
                    *draw_count as GLsizei,
                    *stride as GLsizei,
                );
                gl.bind_buffer(GL_DRAW_INDIRECT_BUFFER, 0);
            }
            Operation::DrawIndexedIndirect {
                buffer,
                offset,
                draw_count,
                stride,
            } => {
                assert!(
                    self.backend.capabilities.indirect_draw,
                    "indirect draws are unsupported on this backend"
                );
                let mode = self.prepare_draw();
                let Some((_, _, index_type)) = self.index_buffer else {
                    panic!("indexed draw without a bound index buffer");
                };
                gl.bind_buffer(GL_DRAW_INDIRECT_BUFFER, buffer.gpu.gl_name());
                gl.multi_draw_elements_indirect(
                    mode,
                    convert_index_type(index_type),
                    *offset as GLintptr,
                    *draw_count as GLsizei,
                    *stride as GLsizei,
                );
                gl.bind_buffer(GL_DRAW_INDIRECT_BUFFER, 0);
            }
            Operation::Dispatch { x, y, z } => {
                self.prepare_dispatch();
                gl.dispatch_compute(*x, *y, *z);
            }
            Operation::DispatchIndirect { buffer, offset } => {
                self.prepare_dispatch();
                gl.bind_buffer(GL_DISPATCH_INDIRECT_BUFFER, buffer.gpu.gl_name());
                gl.dispatch_compute_indirect(*offset as GLintptr);
                gl.bind_buffer(GL_DISPATCH_INDIRECT_BUFFER, 0);
            }
            Operation::ClearColourImage {
                image,
                colour,
                ranges,
                ..
            } => self.clear_image(image, ranges, |gl| clear_colour(gl, 0, colour)),
            Operation::ClearDepthStencilImage {
                image,
                value,
                ranges,
                ..
            } => {
                let format = image.format();
                self.clear_image(image, ranges, |gl| {
                    clear_depth_stencil(
                        gl,
                        format.is_depth().then_some(value.depth),
                        format.has_stencil().then_some(value.stencil),
                    )
                })
            }
            Operation::ClearAttachments { attachments, rects } => {
                self.clear_attachments(attachments, rects)
            }
            Operation::CopyBuffer { src, dst, regions } => self.copy_buffer(src, dst, regions),
            Operation::CopyImage {
                src, dst, regions, ..
            } => self.copy_image(src, dst, regions),
            Operation::CopyBufferToImage {
                src, dst, regions, ..
            } => self.copy_buffer_to_image(src, dst, regions),
            Operation::PipelineBarrier {
                dst_stage,
                memory,
                buffers,
                images,
                ..
            } => {
                if !self.backend.capabilities.memory_barriers {
                    log::trace!("GL replay: barriers have no effect on {:?}", self.backend.profile);
                    return;
                }
                let access = memory
                    .iter()
                    .map(|barrier| barrier.dst_access)
                    .chain(buffers.iter().map(|barrier| barrier.dst_access))
                    .chain(images.iter().map(|barrier| barrier.dst_access))
                    .fold(AccessFlags::empty(), |all, access| all | access);
                let mut bits = convert_access_flags(access);
                if bits == 0 {
                    bits = convert_stage_flags(*dst_stage);
                }
                if bits != 0 {
                    gl.memory_barrier(bits);
                }
            }
            // Query objects are reset implicitly by glBeginQuery.
            Operation::ResetQueryPool { .. } => {}
            Operation::BeginQuery { pool, query, .. } => {
                let (name, target) = query_object(pool, *query);
                gl.begin_query(target, name);
            }
            Operation::EndQuery { pool, query } => {
                let (_, target) = query_object(pool, *query);
                gl.end_query(target);
            }
            Operation::WriteTimestamp { pool, query, .. } => {
                let (name, _) = query_object(pool, *query);
                gl.query_counter(name, GL_TIMESTAMP);
            }
            Operation::PushConstants { constants, .. } => push_constants(gl, constants),
            Operation::ExecuteCommands { lists } => {
                for list in lists {
                    self.execute(list);
                }
            }
        }
    }

    // ========================================================================
    // Render passes
    // ========================================================================

    fn begin_render_pass(
        &mut self,
        render_pass: &'a RenderPass,
        framebuffer: &'a Framebuffer,
        render_area: Rect2d,
        clear_values: &[ClearValue],
    ) {
        let gl = self.gl;
        gl.bind_framebuffer(GL_DRAW_FRAMEBUFFER, framebuffer.gpu.gl_name());
        self.render_pass = Some((render_pass, framebuffer));
        self.subpass = 0;
        self.set_scissor(render_area);

        let attachments = render_pass.attachments();
        if attachments.iter().any(|attachment| attachment.clears_on_load()) {
            // While clearing, draw buffer i is attachment i.
            let buffers: Vec<GLenum> = attachments
                .iter()
                .enumerate()
                .map(|(index, attachment)| {
                    if attachment.format.is_depth_or_stencil() {
                        GL_NONE
                    } else {
                        GL_COLOR_ATTACHMENT0 + index as GLenum
                    }
                })
                .collect();
            gl.draw_buffers(&buffers);
            self.unmask_writes();
            for (index, attachment) in attachments.iter().enumerate() {
                if !attachment.clears_on_load() {
                    continue;
                }
                let Some(value) = clear_values.get(index) else {
                    panic!("no clear value for attachment {index}");
                };
                match value {
                    ClearValue::Colour(colour) if !attachment.format.is_depth_or_stencil() => {
                        clear_colour(gl, index as GLint, colour)
                    }
                    ClearValue::DepthStencil(value) if attachment.format.is_depth_or_stencil() => {
                        let format = attachment.format;
                        let depth = format.is_depth()
                            && attachment.load_op == AttachmentLoadOp::Clear;
                        let stencil = format.has_stencil()
                            && attachment.stencil_load_op == AttachmentLoadOp::Clear;
                        clear_depth_stencil(
                            gl,
                            depth.then_some(value.depth),
                            stencil.then_some(value.stencil),
                        );
                    }
                    mismatched => log::warn!(
                        "GL replay: clear value {mismatched:?} does not fit {:?} attachment {index}, not cleared",
                        attachment.format
                    ),
                }
            }
            self.restore_writes();
        }
        self.apply_subpass_draw_buffers();
    }

    /// Fragment output `i` goes to colour reference `i` of the subpass.
    fn apply_subpass_draw_buffers(&self) {
        let Some((render_pass, _)) = self.render_pass else {
            return;
        };
        let buffers: Vec<GLenum> = render_pass
            .subpass(self.subpass)
            .colour_attachments
            .iter()
            .map(|reference| GL_COLOR_ATTACHMENT0 + reference.attachment)
            .collect();
        if buffers.is_empty() {
            self.gl.draw_buffers(&[GL_NONE]);
        } else {
            self.gl.draw_buffers(&buffers);
        }
    }

    fn clear_attachments(&mut self, attachments: &[ClearAttachment], rects: &[ClearRect]) {
        assert!(
            self.render_pass.is_some(),
            "ClearAttachments outside a render pass"
        );
        let gl = self.gl;
        let previous = self.scissor;
        self.unmask_writes();
        for rect in rects {
            self.set_scissor(rect.rect);
            for attachment in attachments {
                match (&attachment.clear_value, attachment.aspect_mask) {
                    (ClearValue::Colour(colour), aspects) if aspects.contains(ImageAspectFlags::COLOR) => {
                        clear_colour(gl, attachment.colour_attachment as GLint, colour)
                    }
                    (ClearValue::DepthStencil(value), aspects) => clear_depth_stencil(
                        gl,
                        aspects
                            .contains(ImageAspectFlags::DEPTH)
                            .then_some(value.depth),
                        aspects
                            .contains(ImageAspectFlags::STENCIL)
                            .then_some(value.stencil),
                    ),
                    (value, aspects) => {
                        panic!("clear value {value:?} does not match aspects {aspects:?}")
                    }
                }
            }
        }
        match previous {
            Some(rect) => self.set_scissor(rect),
            None => {
                gl.disable(GL_SCISSOR_TEST);
                self.scissor = None;
            }
        }
        self.restore_writes();
    }

    /// Clears every level and layer of `ranges` through the scratch draw
    /// framebuffer.
    fn clear_image(
        &mut self,
        image: &Image,
        ranges: &[ImageSubresourceRange],
        clear: impl Fn(&dyn GlApi),
    ) {
        let gl = self.gl;
        let point = attachment_point(image.format());
        gl.bind_framebuffer(GL_DRAW_FRAMEBUFFER, self.backend.draw_fbo);
        gl.disable(GL_SCISSOR_TEST);
        self.unmask_writes();
        if point == GL_COLOR_ATTACHMENT0 {
            gl.draw_buffers(&[GL_COLOR_ATTACHMENT0]);
        }
        for range in ranges {
            for level in range.base_mip_level..range.base_mip_level + range.level_count {
                for layer in range.base_array_layer..range.base_array_layer + range.layer_count {
                    attach_texture(gl, GL_DRAW_FRAMEBUFFER, point, image, level, layer);
                    clear(gl);
                }
            }
        }
        detach(gl, GL_DRAW_FRAMEBUFFER, point);
        self.restore_framebuffer();
        self.restore_writes();
    }

    /// Rebinds the render pass framebuffer (or the default one) and its
    /// scissor after scratch framebuffer work.
    fn restore_framebuffer(&self) {
        let fbo = self
            .render_pass
            .map_or(0, |(_, framebuffer)| framebuffer.gpu.gl_name());
        self.gl.bind_framebuffer(GL_DRAW_FRAMEBUFFER, fbo);
        if self.render_pass.is_some() {
            self.apply_subpass_draw_buffers();
        }
        if let Some(rect) = self.scissor {
            self.gl.enable(GL_SCISSOR_TEST);
            self.gl.scissor(rect.offset.x, rect.offset.y, rect.extent.width as GLsizei, rect.extent.height as GLsizei);
        }
    }

    /// Clears ignore the pipeline write masks in Vulkan but not in GL.
    fn unmask_writes(&self) {
        let gl = self.gl;
        gl.color_mask(true, true, true, true);
        gl.depth_mask(true);
        gl.stencil_mask_separate(GL_FRONT_AND_BACK, !0);
        gl.disable(GL_RASTERIZER_DISCARD);
    }

    fn restore_writes(&self) {
        let Some(pipeline) = self.graphics_pipeline else {
            return;
        };
        let gl = self.gl;
        let state = pipeline.state();
        let mask = state
            .colour_blend
            .attachments
            .first()
            .map(|attachment| attachment.write_mask)
            .unwrap_or_default();
        apply_colour_mask(gl, mask);
        gl.depth_mask(state.depth_stencil.map_or(false, |ds| ds.depth_write));
        self.apply_stencil_write_mask(StencilFaceFlags::FRONT_AND_BACK);
        if state.rasterisation.rasteriser_discard {
            gl.enable(GL_RASTERIZER_DISCARD);
        }
    }

    // ========================================================================
    // Pipelines and fixed-function state
    // ========================================================================

    fn use_program(&mut self, program: GLuint) {
        if self.program != program {
            self.gl.use_program(program);
            self.program = program;
        }
    }

    fn bind_graphics_pipeline(&mut self, pipeline: &'a Pipeline) {
        let gl = self.gl;
        let state = pipeline.state();
        let dynamic = |flag| pipeline.is_dynamic(flag);
        let toggle = |cap, on: bool| if on { gl.enable(cap) } else { gl.disable(cap) };
        let gl4 = self.backend.profile == GlProfile::Gl4;

        self.use_program(pipeline.gpu.gl_program());

        if gl4 {
            toggle(GL_PRIMITIVE_RESTART_FIXED_INDEX, state.input_assembly.primitive_restart);
        } else {
            assert!(
                !state.input_assembly.primitive_restart,
                "primitive restart is unsupported on this backend"
            );
        }
        if let Some(tessellation) = &state.tessellation {
            gl.patch_parameter_i(GL_PATCH_VERTICES, tessellation.patch_control_points as GLint);
        }

        let rasterisation = &state.rasterisation;
        toggle(GL_DEPTH_CLAMP, rasterisation.depth_clamp);
        toggle(GL_RASTERIZER_DISCARD, rasterisation.rasteriser_discard);
        gl.polygon_mode(GL_FRONT_AND_BACK, convert_polygon_mode(rasterisation.polygon_mode));
        match convert_cull_mode(rasterisation.cull_mode) {
            Some(mode) => {
                gl.enable(GL_CULL_FACE);
                gl.cull_face(mode);
            }
            None => gl.disable(GL_CULL_FACE),
        }
        gl.front_face(convert_front_face(rasterisation.front_face));
        toggle(GL_POLYGON_OFFSET_FILL, rasterisation.depth_bias_enable);
        if rasterisation.depth_bias_enable && !dynamic(DynamicStateFlags::DEPTH_BIAS) {
            self.set_depth_bias(
                rasterisation.depth_bias_constant_factor,
                rasterisation.depth_bias_clamp,
                rasterisation.depth_bias_slope_factor,
            );
        }
        if !dynamic(DynamicStateFlags::LINE_WIDTH) {
            gl.line_width(rasterisation.line_width);
        }

        let multisample = &state.multisample;
        toggle(GL_MULTISAMPLE, multisample.samples.count() > 1);
        toggle(GL_SAMPLE_ALPHA_TO_COVERAGE, multisample.alpha_to_coverage);
        toggle(GL_SAMPLE_ALPHA_TO_ONE, multisample.alpha_to_one);
        if gl4 {
            toggle(GL_SAMPLE_SHADING, multisample.sample_shading);
            if multisample.sample_shading {
                gl.min_sample_shading(multisample.min_sample_shading);
            }
        }

        match &state.depth_stencil {
            Some(depth_stencil) => {
                toggle(GL_DEPTH_TEST, depth_stencil.depth_test);
                gl.depth_func(convert_compare_op(depth_stencil.depth_compare));
                gl.depth_mask(depth_stencil.depth_write);
                toggle(GL_STENCIL_TEST, depth_stencil.stencil_test);
                for (current, new) in self.stencil.iter_mut().zip([depth_stencil.front, depth_stencil.back]) {
                    current.fail_op = new.fail_op;
                    current.pass_op = new.pass_op;
                    current.depth_fail_op = new.depth_fail_op;
                    current.compare_op = new.compare_op;
                    if !dynamic(DynamicStateFlags::STENCIL_REFERENCE) {
                        current.reference = new.reference;
                    }
                    if !dynamic(DynamicStateFlags::STENCIL_COMPARE_MASK) {
                        current.compare_mask = new.compare_mask;
                    }
                    if !dynamic(DynamicStateFlags::STENCIL_WRITE_MASK) {
                        current.write_mask = new.write_mask;
                    }
                }
                for (face, state) in [(GL_FRONT, self.stencil[0]), (GL_BACK, self.stencil[1])] {
                    gl.stencil_op_separate(
                        face,
                        convert_stencil_op(state.fail_op),
                        convert_stencil_op(state.depth_fail_op),
                        convert_stencil_op(state.pass_op),
                    );
                }
                self.apply_stencil_func(StencilFaceFlags::FRONT_AND_BACK);
                self.apply_stencil_write_mask(StencilFaceFlags::FRONT_AND_BACK);
            }
            None => {
                gl.disable(GL_DEPTH_TEST);
                gl.disable(GL_STENCIL_TEST);
                gl.depth_mask(false);
            }
        }

        let blend = &state.colour_blend;
        match blend.logic_op {
            Some(op) => {
                gl.enable(GL_COLOR_LOGIC_OP);
                gl.logic_op(convert_logic_op(op));
            }
            None => gl.disable(GL_COLOR_LOGIC_OP),
        }
        // GL3 has no per-draw-buffer blend state; attachment 0 applies to all.
        let attachment = blend.attachments.first().copied().unwrap_or_default();
        toggle(GL_BLEND, attachment.blend_enable);
        gl.blend_func_separate(
            convert_blend_factor(attachment.src_colour),
            convert_blend_factor(attachment.dst_colour),
            convert_blend_factor(attachment.src_alpha),
            convert_blend_factor(attachment.dst_alpha),
        );
        gl.blend_equation_separate(
            convert_blend_op(attachment.colour_op),
            convert_blend_op(attachment.alpha_op),
        );
        apply_colour_mask(gl, attachment.write_mask);
        if !dynamic(DynamicStateFlags::BLEND_CONSTANTS) {
            let [r, g, b, a] = blend.blend_constants;
            gl.blend_color(r, g, b, a);
        }

        if !dynamic(DynamicStateFlags::VIEWPORT) {
            if let Some(viewport) = &state.viewport {
                self.set_viewport(viewport);
            }
        }
        if !dynamic(DynamicStateFlags::SCISSOR) {
            if let Some(rect) = state.scissor {
                self.set_scissor(rect);
            }
        }

        self.graphics_pipeline = Some(pipeline);
        self.vertex_dirty = true;
    }

    fn set_viewport(&self, viewport: &Viewport) {
        self.gl.viewport(
            viewport.x as GLint,
            viewport.y as GLint,
            viewport.width as GLsizei,
            viewport.height as GLsizei,
        );
        self.gl
            .depth_range(f64::from(viewport.min_depth), f64::from(viewport.max_depth));
    }

    fn set_scissor(&mut self, rect: Rect2d) {
        if self.scissor.is_none() {
            self.gl.enable(GL_SCISSOR_TEST);
        }
        self.gl.scissor(
            rect.offset.x,
            rect.offset.y,
            rect.extent.width as GLsizei,
            rect.extent.height as GLsizei,
        );
        self.scissor = Some(rect);
    }

    fn set_depth_bias(&self, constant_factor: f32, clamp: f32, slope_factor: f32) {
        if self.backend.capabilities.depth_bias_clamp {
            self.gl.polygon_offset_clamp(slope_factor, constant_factor, clamp);
        } else {
            if clamp != 0.0 {
                log::warn!("GL replay: depth bias clamp {clamp} ignored on GL {}", self.backend.version);
            }
            self.gl.polygon_offset(slope_factor, constant_factor);
        }
    }

    fn update_stencil(&mut self, faces: StencilFaceFlags, update: impl Fn(&mut StencilOpState)) {
        let (front, back) = stencil_faces(faces);
        if front {
            update(&mut self.stencil[0]);
        }
        if back {
            update(&mut self.stencil[1]);
        }
    }

    fn apply_stencil_func(&self, faces: StencilFaceFlags) {
        let (front, back) = stencil_faces(faces);
        for (face, state, enabled) in [
            (GL_FRONT, &self.stencil[0], front),
            (GL_BACK, &self.stencil[1], back),
        ] {
            if enabled {
                self.gl.stencil_func_separate(
                    face,
                    convert_compare_op(state.compare_op),
                    state.reference as GLint,
                    state.compare_mask,
                );
            }
        }
    }

    fn apply_stencil_write_mask(&self, faces: StencilFaceFlags) {
        let (front, back) = stencil_faces(faces);
        if front {
            self.gl.stencil_mask_separate(GL_FRONT, self.stencil[0].write_mask);
        }
        if back {
            self.gl.stencil_mask_separate(GL_BACK, self.stencil[1].write_mask);
        }
    }

    // ========================================================================
    // Draws, dispatches and resource bindings
    // ========================================================================

    /// Makes the graphics program current and flushes vertex input; returns
    /// the primitive mode.
    fn prepare_draw(&mut self) -> GLenum {
        let Some(pipeline) = self.graphics_pipeline else {
            panic!("draw without a bound graphics pipeline");
        };
        self.use_program(pipeline.gpu.gl_program());
        if self.vertex_dirty {
            self.flush_vertex_input(pipeline);
        }
        convert_topology(pipeline.state().input_assembly.topology)
    }

    fn prepare_dispatch(&mut self) {
        assert!(
            self.backend.capabilities.compute,
            "compute dispatch is unsupported on this backend"
        );
        let Some(pipeline) = self.compute_pipeline else {
            panic!("dispatch without a bound compute pipeline");
        };
        self.use_program(pipeline.gpu.gl_program());
    }

    fn flush_vertex_input(&mut self, pipeline: &Pipeline) {
        let gl = self.gl;
        let input = &pipeline.state().vertex_input;
        gl.bind_vertex_array(self.backend.vao);
        let used: BTreeSet<GLuint> = input.attributes.iter().map(|a| a.location).collect();
        {
            let mut enabled = self.backend.enabled_attributes.lock();
            for location in enabled.difference(&used) {
                gl.disable_vertex_attrib_array(*location);
            }
            *enabled = used;
        }
        for attribute in &input.attributes {
            let Some(binding) = input.binding(attribute.binding) else {
                panic!("attribute {} uses undeclared binding {}", attribute.location, attribute.binding);
            };
            let Some((buffer, offset)) = self.vertex_buffers.get(&attribute.binding) else {
                panic!("no vertex buffer bound at binding {}", attribute.binding);
            };
            let format = convert_vertex_format(attribute.format);
            let pointer = (offset + u64::from(attribute.offset)) as GLintptr;
            let stride = binding.stride as GLsizei;
            gl.bind_buffer(GL_ARRAY_BUFFER, buffer.gpu.gl_name());
            gl.enable_vertex_attrib_array(attribute.location);
            if format.integer {
                gl.vertex_attrib_i_pointer(attribute.location, format.size, format.ty, stride, pointer);
            } else {
                gl.vertex_attrib_pointer(
                    attribute.location,
                    format.size,
                    format.ty,
                    format.normalized,
                    stride,
                    pointer,
                );
            }
            let divisor = match binding.input_rate {
                VertexInputRate::Vertex => 0,
                VertexInputRate::Instance => 1,
            };
            gl.vertex_attrib_divisor(attribute.location, divisor);
        }
        gl.bind_buffer(GL_ARRAY_BUFFER, 0);
        if let Some((buffer, _, _)) = self.index_buffer {
            gl.bind_buffer(GL_ELEMENT_ARRAY_BUFFER, buffer.gpu.gl_name());
        }
        self.vertex_dirty = false;
    }

    /// GL binding point of a descriptor is the flat offset of its binding
    /// plus its array element, offset by the set's base in the pipeline
    /// layout.
    fn bind_descriptor_sets(
        &self,
        layout: &PipelineLayout,
        first_set: u32,
        sets: &[Arc<DescriptorSet>],
        dynamic_offsets: &[u32],
    ) {
        let gl = self.gl;
        let mut dynamic_offsets = dynamic_offsets.iter();
        for (set_index, set) in (first_set..).zip(sets) {
            let base = layout.binding_base(set_index);
            for ((binding, element), resource) in set.bound_resources() {
                let (Some(ty), Some(slot)) = (
                    set.layout().binding(binding).map(|b| b.descriptor_type),
                    set.layout().binding_offset(binding),
                ) else {
                    panic!("descriptor set has no binding {binding}");
                };
                let point = base + slot + element;
                match resource {
                    DescriptorResource::Buffer {
                        buffer,
                        offset,
                        range,
                    } => {
                        let target = match ty {
                            DescriptorType::UniformBuffer | DescriptorType::UniformBufferDynamic => {
                                GL_UNIFORM_BUFFER
                            }
                            DescriptorType::StorageBuffer | DescriptorType::StorageBufferDynamic => {
                                assert!(
                                    self.backend.capabilities.compute,
                                    "storage buffers are unsupported on this backend"
                                );
                                GL_SHADER_STORAGE_BUFFER
                            }
                            other => panic!("{other:?} descriptors are unsupported on this backend"),
                        };
                        let dynamic = match ty {
                            DescriptorType::UniformBufferDynamic
                            | DescriptorType::StorageBufferDynamic => {
                                let Some(offset) = dynamic_offsets.next() else {
                                    panic!("missing dynamic offset for binding {binding}");
                                };
                                u64::from(*offset)
                            }
                            _ => 0,
                        };
                        gl.bind_buffer_range(
                            target,
                            point,
                            buffer.gpu.gl_name(),
                            (offset + dynamic) as GLintptr,
                            range as GLsizeiptr,
                        );
                    }
                    DescriptorResource::Image { view, .. } => {
                        assert!(
                            ty != DescriptorType::StorageImage,
                            "storage images are unsupported on this backend"
                        );
                        let (name, target) = view.image().gpu.gl_texture();
                        gl.active_texture(GL_TEXTURE0 + point);
                        gl.bind_texture(target, name);
                    }
                    DescriptorResource::Sampler(sampler) => {
                        gl.bind_sampler(point, sampler.gpu.gl_name());
                    }
                    DescriptorResource::CombinedImageSampler { view, sampler, .. } => {
                        let (name, target) = view.image().gpu.gl_texture();
                        gl.active_texture(GL_TEXTURE0 + point);
                        gl.bind_texture(target, name);
                        gl.bind_sampler(point, sampler.gpu.gl_name());
                    }
                }
            }
        }
    }

    // ========================================================================
    // Transfers
    // ========================================================================

    fn copy_buffer(&self, src: &Buffer, dst: &Buffer, regions: &[BufferCopy]) {
        let gl = self.gl;
        gl.bind_buffer(GL_COPY_READ_BUFFER, src.gpu.gl_name());
        gl.bind_buffer(GL_COPY_WRITE_BUFFER, dst.gpu.gl_name());
        for region in regions {
            gl.copy_buffer_sub_data(
                GL_COPY_READ_BUFFER,
                GL_COPY_WRITE_BUFFER,
                region.src_offset as GLintptr,
                region.dst_offset as GLintptr,
                region.size as GLsizeiptr,
            );
        }
        gl.bind_buffer(GL_COPY_READ_BUFFER, 0);
        gl.bind_buffer(GL_COPY_WRITE_BUFFER, 0);
    }

    fn copy_image(&self, src: &Image, dst: &Image, regions: &[ImageCopy]) {
        let gl = self.gl;
        let src_point = attachment_point(src.format());
        let dst_point = attachment_point(dst.format());
        gl.bind_framebuffer(GL_READ_FRAMEBUFFER, self.backend.read_fbo);
        gl.bind_framebuffer(GL_DRAW_FRAMEBUFFER, self.backend.draw_fbo);
        gl.disable(GL_SCISSOR_TEST);
        if src_point == GL_COLOR_ATTACHMENT0 {
            gl.read_buffer(GL_COLOR_ATTACHMENT0);
        }
        if dst_point == GL_COLOR_ATTACHMENT0 {
            gl.draw_buffers(&[GL_COLOR_ATTACHMENT0]);
        }
        for region in regions {
            let (src_sub, dst_sub) = (region.src_subresource, region.dst_subresource);
            let (width, height) = (region.extent.width as GLint, region.extent.height as GLint);
            let (sx, sy) = (region.src_offset.x, region.src_offset.y);
            let (dx, dy) = (region.dst_offset.x, region.dst_offset.y);
            for layer in 0..src_sub.layer_count {
                attach_texture(
                    gl,
                    GL_READ_FRAMEBUFFER,
                    src_point,
                    src,
                    src_sub.mip_level,
                    src_sub.base_array_layer + layer,
                );
                attach_texture(
                    gl,
                    GL_DRAW_FRAMEBUFFER,
                    dst_point,
                    dst,
                    dst_sub.mip_level,
                    dst_sub.base_array_layer + layer,
                );
                gl.blit_framebuffer(
                    sx,
                    sy,
                    sx + width,
                    sy + height,
                    dx,
                    dy,
                    dx + width,
                    dy + height,
                    convert_aspect_mask(src_sub.aspect_mask),
                    GL_NEAREST,
                );
            }
        }
        detach(gl, GL_READ_FRAMEBUFFER, src_point);
        detach(gl, GL_DRAW_FRAMEBUFFER, dst_point);
        gl.bind_framebuffer(GL_READ_FRAMEBUFFER, 0);
        self.restore_framebuffer();
    }

    fn copy_buffer_to_image(&self, src: &Buffer, dst: &Image, regions: &[BufferImageCopy]) {
        let gl = self.gl;
        let (name, target) = dst.gpu.gl_texture();
        assert!(
            target != GL_TEXTURE_2D_MULTISAMPLE,
            "uploads to multisampled images are unsupported"
        );
        let format = convert_format(dst.format());
        gl.bind_buffer(GL_PIXEL_UNPACK_BUFFER, src.gpu.gl_name());
        gl.active_texture(GL_TEXTURE0 + UPLOAD_TEXTURE_UNIT);
        gl.bind_texture(target, name);
        gl.pixel_store_i(GL_UNPACK_ALIGNMENT, 1);
        for region in regions {
            let subresource = region.image_subresource;
            let (offset, extent) = (region.image_offset, region.image_extent);
            gl.pixel_store_i(GL_UNPACK_ROW_LENGTH, region.buffer_row_length as GLint);
            gl.pixel_store_i(GL_UNPACK_IMAGE_HEIGHT, region.buffer_image_height as GLint);
            let level = subresource.mip_level as GLint;
            let (width, height) = (extent.width as GLsizei, extent.height as GLsizei);
            let buffer_offset = region.buffer_offset as GLintptr;
            match target {
                GL_TEXTURE_2D => gl.tex_sub_image_2d_pbo(
                    target,
                    level,
                    offset.x,
                    offset.y,
                    width,
                    height,
                    format.format,
                    format.ty,
                    buffer_offset,
                ),
                GL_TEXTURE_2D_ARRAY => gl.tex_sub_image_3d_pbo(
                    target,
                    level,
                    offset.x,
                    offset.y,
                    subresource.base_array_layer as GLint,
                    width,
                    height,
                    subresource.layer_count as GLsizei,
                    format.format,
                    format.ty,
                    buffer_offset,
                ),
                GL_TEXTURE_3D => gl.tex_sub_image_3d_pbo(
                    target,
                    level,
                    offset.x,
                    offset.y,
                    offset.z,
                    width,
                    height,
                    extent.depth as GLsizei,
                    format.format,
                    format.ty,
                    buffer_offset,
                ),
                other => panic!("uploads to texture target {other:#x} are unsupported"),
            }
        }
        gl.pixel_store_i(GL_UNPACK_ROW_LENGTH, 0);
        gl.pixel_store_i(GL_UNPACK_IMAGE_HEIGHT, 0);
        gl.pixel_store_i(GL_UNPACK_ALIGNMENT, 4);
        gl.bind_texture(target, 0);
        gl.bind_buffer(GL_PIXEL_UNPACK_BUFFER, 0);
    }
}

fn attachment_point(format: Format) -> GLenum {
    if format.is_depth_or_stencil() {
        depth_stencil_attachment_point(format)
    } else {
        GL_COLOR_ATTACHMENT0
    }
}

fn detach(gl: &dyn GlApi, target: GLenum, point: GLenum) {
    gl.framebuffer_texture_2d(target, point, GL_TEXTURE_2D, 0, 0);
}

fn apply_colour_mask(gl: &dyn GlApi, mask: ColourComponentFlags) {
    gl.color_mask(
        mask.contains(ColourComponentFlags::R),
        mask.contains(ColourComponentFlags::G),
        mask.contains(ColourComponentFlags::B),
        mask.contains(ColourComponentFlags::A),
    );
}

fn clear_colour(gl: &dyn GlApi, draw_buffer: GLint, colour: &ClearColourValue) {
    match colour {
        ClearColourValue::Float32(values) => gl.clear_buffer_fv(GL_COLOR, draw_buffer, values),
        ClearColourValue::Int32(values) => gl.clear_buffer_iv(GL_COLOR, draw_buffer, values),
        ClearColourValue::Uint32(values) => gl.clear_buffer_uiv(GL_COLOR, draw_buffer, values),
    }
}

fn clear_depth_stencil(gl: &dyn GlApi, depth: Option<f32>, stencil: Option<u32>) {
    match (depth, stencil) {
        (Some(depth), Some(stencil)) => gl.clear_buffer_fi(GL_DEPTH_STENCIL, 0, depth, stencil as GLint),
        (Some(depth), None) => gl.clear_buffer_fv(GL_DEPTH, 0, &[depth]),
        (None, Some(stencil)) => gl.clear_buffer_iv(GL_STENCIL, 0, &[stencil as GLint]),
        (None, None) => {}
    }
}

fn query_object(pool: &QueryPool, query: u32) -> (GLuint, GLenum) {
    let GpuQueryPool::Gl { names, target, .. } = &pool.gpu else {
        panic!("query pool does not belong to a GL device");
    };
    let Some(name) = names.get(query as usize) else {
        panic!("query pool has no query {query}");
    };
    (*name, *target)
}

/// Uploads each constant to its uniform location, reading `data` in
/// declaration order.
fn push_constants(gl: &dyn GlApi, constants: &PushConstantsDesc) {
    let mut cursor = 0;
    for constant in &constants.constants {
        let size = constant.format.size();
        let Some(bytes) = constants.data.get(cursor..cursor + size) else {
            panic!(
                "push constant data too short: {} bytes, constant at {cursor} needs {size}",
                constants.data.len()
            );
        };
        let location = constant.location as GLint;
        let floats = || read_values::<f32>(bytes);
        let ints = || read_values::<i32>(bytes);
        let uints = || read_values::<u32>(bytes);
        match constant.format {
            ConstantFormat::Float => gl.uniform_1fv(location, &floats()),
            ConstantFormat::Vec2f => gl.uniform_2fv(location, &floats()),
            ConstantFormat::Vec3f => gl.uniform_3fv(location, &floats()),
            ConstantFormat::Vec4f | ConstantFormat::Colour => gl.uniform_4fv(location, &floats()),
            ConstantFormat::Mat2f => gl.uniform_matrix_2fv(location, false, &floats()),
            ConstantFormat::Mat3f => gl.uniform_matrix_3fv(location, false, &floats()),
            ConstantFormat::Mat4f => gl.uniform_matrix_4fv(location, false, &floats()),
            ConstantFormat::Int => gl.uniform_1iv(location, &ints()),
            ConstantFormat::Vec2i => gl.uniform_2iv(location, &ints()),
            ConstantFormat::Vec3i => gl.uniform_3iv(location, &ints()),
            ConstantFormat::Vec4i => gl.uniform_4iv(location, &ints()),
            ConstantFormat::UInt => gl.uniform_1uiv(location, &uints()),
            ConstantFormat::Vec2ui => gl.uniform_2uiv(location, &uints()),
            ConstantFormat::Vec3ui => gl.uniform_3uiv(location, &uints()),
            ConstantFormat::Vec4ui => gl.uniform_4uiv(location, &uints()),
        }
        cursor += size;
    }
}

fn read_values<T: bytemuck::AnyBitPattern>(bytes: &[u8]) -> Vec<T> {
    bytes
        .chunks_exact(std::mem::size_of::<T>())
        .map(bytemuck::pod_read_unaligned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::gl::{GlCall, GlContext, HeadlessPlatform, RecordingGl};
    use crate::backend::GpuLayoutObject;
    use crate::command::{MemoryBarrier, Operation};
    use crate::device::DeviceId;
    use crate::types::{BufferDescriptor, BufferUsageFlags, DependencyFlags, PipelineStageFlags, PushConstant};

    struct Fixture {
        backend: GlBackend,
        gl: RecordingGl,
    }

    impl Fixture {
        fn new(version: &str, profile: GlProfile) -> Self {
            let gl = RecordingGl::with_version(version);
            let context = Arc::new(GlContext::new(
                Arc::new(HeadlessPlatform::new()),
                Arc::new(gl.clone()),
            ));
            let backend = GlBackend::new(context, profile, false).unwrap();
            gl.clear_calls();
            Self { backend, gl }
        }

        fn gl4() -> Self {
            Self::new("4.6.0", GlProfile::Gl4)
        }

        fn buffer(&self, size: u64) -> Arc<Buffer> {
            let descriptor = BufferDescriptor::new(size, BufferUsageFlags::all());
            let gpu = self.backend.create_buffer(&descriptor).unwrap();
            Arc::new(Buffer::new(DeviceId::for_tests(), descriptor, gpu))
        }

        /// Replays `operations` and returns the GL calls they produced.
        fn replay(&self, operations: Vec<Operation>) -> Vec<GlCall> {
            let mut list = CommandList::new();
            for operation in operations {
                list.push(operation);
            }
            self.gl.clear_calls();
            let lock = self.backend.context.lock().unwrap();
            let mut replay = ReplayState::new(&self.backend, lock.gl());
            replay.execute(&list);
            replay.finish();
            drop(lock);
            self.gl.take_calls()
        }
    }

    #[test]
    fn test_push_constants_advance_by_format_size() {
        let fixture = Fixture::gl4();
        let mut data = Vec::new();
        data.extend_from_slice(bytemuck::bytes_of(&1.5f32));
        data.extend_from_slice(bytemuck::cast_slice(&[0.1f32, 0.2, 0.3, 0.4]));
        let constants = PushConstantsDesc {
            stages: Default::default(),
            offset: 0,
            constants: vec![
                PushConstant {
                    location: 0,
                    format: ConstantFormat::Float,
                },
                PushConstant {
                    location: 4,
                    format: ConstantFormat::Vec4f,
                },
            ],
            data,
        };
        let layout = Arc::new(PipelineLayout::new(
            DeviceId::for_tests(),
            Vec::new(),
            Vec::new(),
            GpuLayoutObject::Emulated,
        ));
        let calls = fixture.replay(vec![Operation::PushConstants { layout, constants }]);
        assert_eq!(
            calls,
            vec![
                GlCall::Uniform1fv {
                    location: 0,
                    values: vec![1.5]
                },
                GlCall::Uniform4fv {
                    location: 4,
                    values: vec![0.1, 0.2, 0.3, 0.4]
                },
            ]
        );
    }

    #[test]
    fn test_copy_buffer_moves_shadowed_bytes() {
        let fixture = Fixture::gl4();
        let src = fixture.buffer(8);
        let dst = fixture.buffer(8);
        super::super::write_buffer(&fixture.backend.context, src.gpu.gl_name(), 0, &[1, 2, 3, 4, 5, 6, 7, 8])
            .unwrap();
        let calls = fixture.replay(vec![Operation::CopyBuffer {
            src: src.clone(),
            dst: dst.clone(),
            regions: vec![BufferCopy::new(4, 0, 4)],
        }]);
        assert_eq!(calls.len(), 5);
        assert_eq!(
            calls.last(),
            Some(&GlCall::BindBuffer {
                target: GL_COPY_WRITE_BUFFER,
                buffer: 0
            })
        );
        let bytes = super::super::read_buffer(&fixture.backend.context, dst.gpu.gl_name(), 0, 4).unwrap();
        assert_eq!(bytes, vec![5, 6, 7, 8]);
    }

    fn barrier(dst_access: AccessFlags, dst_stage: PipelineStageFlags) -> Operation {
        Operation::PipelineBarrier {
            src_stage: PipelineStageFlags::COMPUTE_SHADER,
            dst_stage,
            dependency_flags: DependencyFlags::empty(),
            memory: vec![MemoryBarrier {
                src_access: AccessFlags::SHADER_WRITE,
                dst_access,
            }],
            buffers: Vec::new(),
            images: Vec::new(),
        }
    }

    #[test]
    fn test_barrier_is_noop_on_gl3() {
        let fixture = Fixture::new("3.3.0", GlProfile::Gl3);
        let calls = fixture.replay(vec![barrier(
            AccessFlags::UNIFORM_READ,
            PipelineStageFlags::VERTEX_SHADER,
        )]);
        assert!(calls.is_empty());
    }

    #[test]
    fn test_barrier_translates_access_mask() {
        let fixture = Fixture::gl4();
        let calls = fixture.replay(vec![barrier(
            AccessFlags::UNIFORM_READ,
            PipelineStageFlags::VERTEX_SHADER,
        )]);
        assert_eq!(calls, vec![GlCall::MemoryBarrier(GL_UNIFORM_BARRIER_BIT)]);
    }

    #[test]
    fn test_barrier_falls_back_to_stage_mask() {
        let fixture = Fixture::gl4();
        let calls = fixture.replay(vec![barrier(
            AccessFlags::empty(),
            PipelineStageFlags::DRAW_INDIRECT,
        )]);
        assert_eq!(calls, vec![GlCall::MemoryBarrier(GL_COMMAND_BARRIER_BIT)]);
    }

    #[test]
    fn test_nested_lists_count_every_operation() {
        let fixture = Fixture::gl4();
        let mut secondary = CommandList::new();
        secondary.push(Operation::SetLineWidth(2.0));
        secondary.push(Operation::SetBlendConstants([1.0; 4]));
        let mut list = CommandList::new();
        list.push(Operation::ExecuteCommands {
            lists: vec![Arc::new(secondary)],
        });
        list.push(Operation::SetLineWidth(1.0));

        let lock = fixture.backend.context.lock().unwrap();
        let mut replay = ReplayState::new(&fixture.backend, lock.gl());
        replay.execute(&list);
        assert_eq!(replay.finish(), 4);
        drop(lock);
        assert_eq!(
            fixture.gl.take_calls(),
            vec![
                GlCall::LineWidth(2.0),
                GlCall::BlendColor([1.0; 4]),
                GlCall::LineWidth(1.0),
            ]
        );
    }

    #[test]
    fn test_stencil_reference_keeps_compare_state() {
        let fixture = Fixture::gl4();
        let calls = fixture.replay(vec![
            Operation::SetStencilCompareMask {
                faces: StencilFaceFlags::FRONT_AND_BACK,
                mask: 0x0f,
            },
            Operation::SetStencilReference {
                faces: StencilFaceFlags::BACK,
                reference: 3,
            },
        ]);
        assert_eq!(
            calls.last(),
            Some(&GlCall::StencilFuncSeparate {
                face: GL_BACK,
                func: GL_ALWAYS,
                reference: 3,
                mask: 0x0f
            })
        );
    }

    #[test]
    fn test_depth_bias_uses_clamp_when_available() {
        let fixture = Fixture::gl4();
        let calls = fixture.replay(vec![Operation::SetDepthBias {
            constant_factor: 1.0,
            clamp: 0.5,
            slope_factor: 2.0,
        }]);
        assert_eq!(
            calls,
            vec![GlCall::PolygonOffsetClamp {
                factor: 2.0,
                units: 1.0,
                clamp: 0.5
            }]
        );
    }

    #[test]
    fn test_depth_stencil_clear_picks_combined_call() {
        let fixture = Fixture::gl4();
        let gl: &dyn GlApi = &fixture.gl;
        clear_depth_stencil(gl, Some(1.0), Some(7));
        clear_depth_stencil(gl, None, Some(2));
        assert_eq!(
            fixture.gl.take_calls(),
            vec![
                GlCall::ClearBufferfi {
                    buffer: GL_DEPTH_STENCIL,
                    draw_buffer: 0,
                    depth: 1.0,
                    stencil: 7
                },
                GlCall::ClearBufferiv {
                    buffer: GL_STENCIL,
                    draw_buffer: 0,
                    values: vec![2]
                },
            ]
        );
    }

    #[test]
    #[should_panic(expected = "draw without a bound graphics pipeline")]
    fn test_draw_without_pipeline_panics() {
        let fixture = Fixture::gl4();
        fixture.replay(vec![Operation::Draw {
            vertex_count: 3,
            instance_count: 1,
            first_vertex: 0,
            first_instance: 0,
        }]);
    }
}
