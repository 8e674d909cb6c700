//! Shader modules, layouts, descriptor sets, render passes and pipelines.
//!
//! Free functions over an `ash::Device`; the backend wraps the returned
//! handles into the resource objects that own them.

use std::ffi::CString;

use ash::vk;

use super::conversion::{
    convert_blend_factor, convert_blend_op, convert_bind_point, convert_colour_components,
    convert_compare_op, convert_cull_mode, convert_descriptor_type, convert_dynamic_states,
    convert_format, convert_front_face, convert_layout, convert_load_op, convert_logic_op,
    convert_pipeline_stages, convert_access, convert_dependency_flags, convert_polygon_mode,
    convert_rect, convert_samples, convert_shader_stages, convert_stencil_state, convert_store_op,
    convert_topology, convert_vertex_input_rate, convert_viewport,
};
use crate::error::{GraphicsError, GraphicsResult};
use crate::resources::{
    DescriptorResource, DescriptorSetLayout, DescriptorWrite, PipelineDescriptor, PipelineLayout,
};
use crate::types::{
    AttachmentReference, DescriptorSetLayoutBinding, DynamicStateFlags, PushConstantRange,
    RenderPassDescriptor, ShaderSource, ShaderStage,
};

fn creation_failed(what: &'static str) -> impl Fn(vk::Result) -> GraphicsError {
    move |e| GraphicsError::ResourceCreationFailed(format!("failed to create {what}: {e:?}"))
}

// ============================================================================
// Shaders
// ============================================================================

/// Creates a shader module from SPIR-V words.
///
/// GLSL is only understood by the GL backends.
pub fn create_shader_module(
    device: &ash::Device,
    stage: &ShaderStage,
) -> GraphicsResult<vk::ShaderModule> {
    let code = match &stage.source {
        ShaderSource::SpirV(words) => words,
        ShaderSource::Glsl(_) => {
            return Err(GraphicsError::FeatureNotSupported(
                "the Vulkan backend requires SPIR-V shaders".to_string(),
            ))
        }
    };
    if code.is_empty() {
        return Err(GraphicsError::InvalidParameter(
            "empty SPIR-V module".to_string(),
        ));
    }

    let create_info = vk::ShaderModuleCreateInfo::default().code(code);
    unsafe { device.create_shader_module(&create_info, None) }
        .map_err(creation_failed("shader module"))
}

// ============================================================================
// Layouts
// ============================================================================

pub fn create_set_layout(
    device: &ash::Device,
    bindings: &[DescriptorSetLayoutBinding],
) -> GraphicsResult<vk::DescriptorSetLayout> {
    let vk_bindings: Vec<vk::DescriptorSetLayoutBinding> = bindings
        .iter()
        .map(|b| {
            vk::DescriptorSetLayoutBinding::default()
                .binding(b.binding)
                .descriptor_type(convert_descriptor_type(b.descriptor_type))
                .descriptor_count(b.count)
                .stage_flags(convert_shader_stages(b.stages))
        })
        .collect();

    let create_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&vk_bindings);
    unsafe { device.create_descriptor_set_layout(&create_info, None) }
        .map_err(creation_failed("descriptor set layout"))
}

pub fn create_pipeline_layout(
    device: &ash::Device,
    set_layouts: &[vk::DescriptorSetLayout],
    push_constant_ranges: &[PushConstantRange],
) -> GraphicsResult<vk::PipelineLayout> {
    let ranges: Vec<vk::PushConstantRange> = push_constant_ranges
        .iter()
        .map(|r| {
            vk::PushConstantRange::default()
                .stage_flags(convert_shader_stages(r.stages))
                .offset(r.offset)
                .size(r.size)
        })
        .collect();

    let create_info = vk::PipelineLayoutCreateInfo::default()
        .set_layouts(set_layouts)
        .push_constant_ranges(&ranges);
    unsafe { device.create_pipeline_layout(&create_info, None) }
        .map_err(creation_failed("pipeline layout"))
}

// ============================================================================
// Descriptor sets
// ============================================================================

/// Pool sizes that fit exactly one set of `layout`.
fn pool_sizes(layout: &DescriptorSetLayout) -> Vec<vk::DescriptorPoolSize> {
    let mut sizes: Vec<vk::DescriptorPoolSize> = Vec::new();
    for binding in layout.bindings() {
        let ty = convert_descriptor_type(binding.descriptor_type);
        match sizes.iter_mut().find(|s| s.ty == ty) {
            Some(size) => size.descriptor_count += binding.count,
            None => sizes.push(
                vk::DescriptorPoolSize::default()
                    .ty(ty)
                    .descriptor_count(binding.count),
            ),
        }
    }
    sizes
}

/// Allocates one descriptor set from a pool of its own.
///
/// Returns the pool and the set; destroying the pool frees the set.
pub fn create_descriptor_set(
    device: &ash::Device,
    layout: &DescriptorSetLayout,
) -> GraphicsResult<(vk::DescriptorPool, vk::DescriptorSet)> {
    let sizes = pool_sizes(layout);
    let pool_info = vk::DescriptorPoolCreateInfo::default()
        .max_sets(1)
        .pool_sizes(&sizes);
    let pool = unsafe { device.create_descriptor_pool(&pool_info, None) }
        .map_err(creation_failed("descriptor pool"))?;

    let set_layouts = [layout.gpu.vk_set_layout()];
    let alloc_info = vk::DescriptorSetAllocateInfo::default()
        .descriptor_pool(pool)
        .set_layouts(&set_layouts);
    match unsafe { device.allocate_descriptor_sets(&alloc_info) } {
        Ok(sets) => Ok((pool, sets[0])),
        Err(e) => {
            unsafe { device.destroy_descriptor_pool(pool, None) };
            Err(match e {
                vk::Result::ERROR_OUT_OF_POOL_MEMORY
                | vk::Result::ERROR_OUT_OF_HOST_MEMORY
                | vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => GraphicsError::OutOfMemory,
                other => creation_failed("descriptor set")(other),
            })
        }
    }
}

/// Writes validated descriptors into `set`.
pub fn update_descriptor_set(
    device: &ash::Device,
    set: vk::DescriptorSet,
    layout: &DescriptorSetLayout,
    writes: &[DescriptorWrite],
) {
    // Info arrays must be complete before the writes borrow them.
    let mut buffer_infos = Vec::with_capacity(writes.len());
    let mut image_infos = Vec::with_capacity(writes.len());
    for write in writes {
        match &write.resource {
            DescriptorResource::Buffer {
                buffer,
                offset,
                range,
            } => buffer_infos.push(
                vk::DescriptorBufferInfo::default()
                    .buffer(buffer.gpu.vk_handle())
                    .offset(*offset)
                    .range(*range),
            ),
            DescriptorResource::Image { view, layout } => image_infos.push(
                vk::DescriptorImageInfo::default()
                    .image_view(view.gpu.vk_handle())
                    .image_layout(convert_layout(*layout)),
            ),
            DescriptorResource::Sampler(sampler) => image_infos
                .push(vk::DescriptorImageInfo::default().sampler(sampler.gpu.vk_handle())),
            DescriptorResource::CombinedImageSampler {
                view,
                sampler,
                layout,
            } => image_infos.push(
                vk::DescriptorImageInfo::default()
                    .sampler(sampler.gpu.vk_handle())
                    .image_view(view.gpu.vk_handle())
                    .image_layout(convert_layout(*layout)),
            ),
        }
    }

    let mut buffer_slots = buffer_infos.iter();
    let mut image_slots = image_infos.iter();
    let mut vk_writes = Vec::with_capacity(writes.len());
    for write in writes {
        let is_buffer = matches!(write.resource, DescriptorResource::Buffer { .. });
        let buffer_slot = if is_buffer { buffer_slots.next() } else { None };
        let image_slot = if is_buffer { None } else { image_slots.next() };
        let Some(binding) = layout.binding(write.binding) else {
            continue;
        };
        let base = vk::WriteDescriptorSet::default()
            .dst_set(set)
            .dst_binding(write.binding)
            .dst_array_element(write.array_element)
            .descriptor_type(convert_descriptor_type(binding.descriptor_type));
        let vk_write = match (buffer_slot, image_slot) {
            (Some(info), _) => base.buffer_info(std::slice::from_ref(info)),
            (_, Some(info)) => base.image_info(std::slice::from_ref(info)),
            (None, None) => continue,
        };
        vk_writes.push(vk_write);
    }

    unsafe { device.update_descriptor_sets(&vk_writes, &[]) };
}

// ============================================================================
// Render passes
// ============================================================================

fn convert_reference(reference: &AttachmentReference) -> vk::AttachmentReference {
    vk::AttachmentReference {
        attachment: reference.attachment,
        layout: convert_layout(reference.layout),
    }
}

pub fn create_render_pass(
    device: &ash::Device,
    descriptor: &RenderPassDescriptor,
) -> GraphicsResult<vk::RenderPass> {
    let attachments: Vec<vk::AttachmentDescription> = descriptor
        .attachments
        .iter()
        .map(|a| {
            vk::AttachmentDescription::default()
                .format(convert_format(a.format))
                .samples(convert_samples(a.samples))
                .load_op(convert_load_op(a.load_op))
                .store_op(convert_store_op(a.store_op))
                .stencil_load_op(convert_load_op(a.stencil_load_op))
                .stencil_store_op(convert_store_op(a.stencil_store_op))
                .initial_layout(convert_layout(a.initial_layout))
                .final_layout(convert_layout(a.final_layout))
        })
        .collect();

    struct SubpassRefs {
        input: Vec<vk::AttachmentReference>,
        colour: Vec<vk::AttachmentReference>,
        resolve: Vec<vk::AttachmentReference>,
        depth: Option<vk::AttachmentReference>,
    }
    let refs: Vec<SubpassRefs> = descriptor
        .subpasses
        .iter()
        .map(|s| SubpassRefs {
            input: s.input_attachments.iter().map(convert_reference).collect(),
            colour: s.colour_attachments.iter().map(convert_reference).collect(),
            resolve: s.resolve_attachments.iter().map(convert_reference).collect(),
            depth: s.depth_stencil_attachment.as_ref().map(convert_reference),
        })
        .collect();

    let subpasses: Vec<vk::SubpassDescription> = descriptor
        .subpasses
        .iter()
        .zip(&refs)
        .map(|(subpass, refs)| {
            let mut desc = vk::SubpassDescription::default()
                .pipeline_bind_point(convert_bind_point(subpass.bind_point))
                .input_attachments(&refs.input)
                .color_attachments(&refs.colour)
                .preserve_attachments(&subpass.preserve_attachments);
            if !refs.resolve.is_empty() {
                desc = desc.resolve_attachments(&refs.resolve);
            }
            if let Some(depth) = &refs.depth {
                desc = desc.depth_stencil_attachment(depth);
            }
            desc
        })
        .collect();

    let dependencies: Vec<vk::SubpassDependency> = descriptor
        .dependencies
        .iter()
        .map(|d| {
            vk::SubpassDependency::default()
                .src_subpass(d.src_subpass)
                .dst_subpass(d.dst_subpass)
                .src_stage_mask(convert_pipeline_stages(d.src_stage_mask))
                .dst_stage_mask(convert_pipeline_stages(d.dst_stage_mask))
                .src_access_mask(convert_access(d.src_access_mask))
                .dst_access_mask(convert_access(d.dst_access_mask))
                .dependency_flags(convert_dependency_flags(d.dependency_flags))
        })
        .collect();

    let create_info = vk::RenderPassCreateInfo::default()
        .attachments(&attachments)
        .subpasses(&subpasses)
        .dependencies(&dependencies);
    unsafe { device.create_render_pass(&create_info, None) }
        .map_err(creation_failed("render pass"))
}

// ============================================================================
// Pipelines
// ============================================================================

/// Shader modules plus their entry point names, destroyed on drop.
struct StageModules<'a> {
    device: &'a ash::Device,
    modules: Vec<vk::ShaderModule>,
    entry_points: Vec<CString>,
}

impl<'a> StageModules<'a> {
    fn new(device: &'a ash::Device, stages: &[ShaderStage]) -> GraphicsResult<Self> {
        let mut this = Self {
            device,
            modules: Vec::with_capacity(stages.len()),
            entry_points: Vec::with_capacity(stages.len()),
        };
        for stage in stages {
            let entry_point = CString::new(stage.entry_point.as_str()).map_err(|_| {
                GraphicsError::InvalidParameter(format!(
                    "entry point {:?} contains a NUL byte",
                    stage.entry_point
                ))
            })?;
            this.modules.push(create_shader_module(device, stage)?);
            this.entry_points.push(entry_point);
        }
        Ok(this)
    }

    fn create_infos(&self, stages: &[ShaderStage]) -> Vec<vk::PipelineShaderStageCreateInfo<'_>> {
        stages
            .iter()
            .zip(&self.modules)
            .zip(&self.entry_points)
            .map(|((stage, module), name)| {
                vk::PipelineShaderStageCreateInfo::default()
                    .stage(convert_shader_stages(stage.stage))
                    .module(*module)
                    .name(name.as_c_str())
            })
            .collect()
    }
}

impl Drop for StageModules<'_> {
    fn drop(&mut self) {
        for module in self.modules.drain(..) {
            unsafe { self.device.destroy_shader_module(module, None) };
        }
    }
}

/// The dynamic states a pipeline is created with.
///
/// Viewport and scissor become dynamic when the pipeline has no static
/// value for them.
pub fn effective_dynamic_states(descriptor: &PipelineDescriptor) -> DynamicStateFlags {
    let mut flags = descriptor.state.dynamic_state;
    if descriptor.state.viewport.is_none() {
        flags |= DynamicStateFlags::VIEWPORT;
    }
    if descriptor.state.scissor.is_none() {
        flags |= DynamicStateFlags::SCISSOR;
    }
    flags
}

pub fn create_graphics_pipeline(
    device: &ash::Device,
    layout: &PipelineLayout,
    descriptor: &PipelineDescriptor,
) -> GraphicsResult<vk::Pipeline> {
    let render_pass = descriptor.render_pass.as_ref().ok_or_else(|| {
        GraphicsError::InvalidParameter("graphics pipeline without a render pass".to_string())
    })?;
    let state = &descriptor.state;

    let modules = StageModules::new(device, &descriptor.stages)?;
    let stages = modules.create_infos(&descriptor.stages);

    let bindings: Vec<vk::VertexInputBindingDescription> = state
        .vertex_input
        .bindings
        .iter()
        .map(|b| vk::VertexInputBindingDescription {
            binding: b.binding,
            stride: b.stride,
            input_rate: convert_vertex_input_rate(b.input_rate),
        })
        .collect();
    let attributes: Vec<vk::VertexInputAttributeDescription> = state
        .vertex_input
        .attributes
        .iter()
        .map(|a| vk::VertexInputAttributeDescription {
            location: a.location,
            binding: a.binding,
            format: convert_format(a.format),
            offset: a.offset,
        })
        .collect();
    let vertex_input = vk::PipelineVertexInputStateCreateInfo::default()
        .vertex_binding_descriptions(&bindings)
        .vertex_attribute_descriptions(&attributes);

    let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
        .topology(convert_topology(state.input_assembly.topology))
        .primitive_restart_enable(state.input_assembly.primitive_restart);

    let tessellation = state.tessellation.map(|t| {
        vk::PipelineTessellationStateCreateInfo::default()
            .patch_control_points(t.patch_control_points)
    });

    // Counts are fixed at one; a dynamic value replaces the placeholder.
    let viewports = [state.viewport.as_ref().map(convert_viewport).unwrap_or_default()];
    let scissors = [state.scissor.as_ref().map(convert_rect).unwrap_or_default()];
    let viewport_state = vk::PipelineViewportStateCreateInfo::default()
        .viewports(&viewports)
        .scissors(&scissors);

    let raster = &state.rasterisation;
    let rasterization = vk::PipelineRasterizationStateCreateInfo::default()
        .depth_clamp_enable(raster.depth_clamp)
        .rasterizer_discard_enable(raster.rasteriser_discard)
        .polygon_mode(convert_polygon_mode(raster.polygon_mode))
        .cull_mode(convert_cull_mode(raster.cull_mode))
        .front_face(convert_front_face(raster.front_face))
        .depth_bias_enable(raster.depth_bias_enable)
        .depth_bias_constant_factor(raster.depth_bias_constant_factor)
        .depth_bias_clamp(raster.depth_bias_clamp)
        .depth_bias_slope_factor(raster.depth_bias_slope_factor)
        .line_width(raster.line_width);

    let ms = &state.multisample;
    let multisample = vk::PipelineMultisampleStateCreateInfo::default()
        .rasterization_samples(convert_samples(ms.samples))
        .sample_shading_enable(ms.sample_shading)
        .min_sample_shading(ms.min_sample_shading)
        .alpha_to_coverage_enable(ms.alpha_to_coverage)
        .alpha_to_one_enable(ms.alpha_to_one);

    let depth_stencil = state.depth_stencil.as_ref().map(|ds| {
        vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(ds.depth_test)
            .depth_write_enable(ds.depth_write)
            .depth_compare_op(convert_compare_op(ds.depth_compare))
            .depth_bounds_test_enable(ds.depth_bounds_test)
            .stencil_test_enable(ds.stencil_test)
            .front(convert_stencil_state(&ds.front))
            .back(convert_stencil_state(&ds.back))
            .min_depth_bounds(ds.min_depth_bounds)
            .max_depth_bounds(ds.max_depth_bounds)
    });

    let blend_attachments: Vec<vk::PipelineColorBlendAttachmentState> = state
        .colour_blend
        .attachments
        .iter()
        .map(|a| {
            vk::PipelineColorBlendAttachmentState::default()
                .blend_enable(a.blend_enable)
                .src_color_blend_factor(convert_blend_factor(a.src_colour))
                .dst_color_blend_factor(convert_blend_factor(a.dst_colour))
                .color_blend_op(convert_blend_op(a.colour_op))
                .src_alpha_blend_factor(convert_blend_factor(a.src_alpha))
                .dst_alpha_blend_factor(convert_blend_factor(a.dst_alpha))
                .alpha_blend_op(convert_blend_op(a.alpha_op))
                .color_write_mask(convert_colour_components(a.write_mask))
        })
        .collect();
    let mut colour_blend = vk::PipelineColorBlendStateCreateInfo::default()
        .attachments(&blend_attachments)
        .blend_constants(state.colour_blend.blend_constants);
    if let Some(op) = state.colour_blend.logic_op {
        colour_blend = colour_blend
            .logic_op_enable(true)
            .logic_op(convert_logic_op(op));
    }

    let dynamic_states = convert_dynamic_states(effective_dynamic_states(descriptor));
    let dynamic_state =
        vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

    let mut create_info = vk::GraphicsPipelineCreateInfo::default()
        .stages(&stages)
        .vertex_input_state(&vertex_input)
        .input_assembly_state(&input_assembly)
        .viewport_state(&viewport_state)
        .rasterization_state(&rasterization)
        .multisample_state(&multisample)
        .color_blend_state(&colour_blend)
        .dynamic_state(&dynamic_state)
        .layout(layout.gpu.vk_pipeline_layout())
        .render_pass(render_pass.gpu.vk_render_pass())
        .subpass(descriptor.subpass);
    if let Some(tessellation) = &tessellation {
        create_info = create_info.tessellation_state(tessellation);
    }
    if let Some(depth_stencil) = &depth_stencil {
        create_info = create_info.depth_stencil_state(depth_stencil);
    }

    let pipelines = unsafe {
        device.create_graphics_pipelines(vk::PipelineCache::null(), &[create_info], None)
    }
    .map_err(|(_, e)| {
        GraphicsError::ResourceCreationFailed(format!("failed to create graphics pipeline: {e:?}"))
    })?;

    Ok(pipelines[0])
}

pub fn create_compute_pipeline(
    device: &ash::Device,
    layout: &PipelineLayout,
    descriptor: &PipelineDescriptor,
) -> GraphicsResult<vk::Pipeline> {
    let modules = StageModules::new(device, &descriptor.stages)?;
    let stages = modules.create_infos(&descriptor.stages);
    let Some(stage) = stages.first() else {
        return Err(GraphicsError::InvalidParameter(
            "compute pipeline without a stage".to_string(),
        ));
    };

    let create_info = vk::ComputePipelineCreateInfo::default()
        .stage(*stage)
        .layout(layout.gpu.vk_pipeline_layout());

    let pipelines = unsafe {
        device.create_compute_pipelines(vk::PipelineCache::null(), &[create_info], None)
    }
    .map_err(|(_, e)| {
        GraphicsError::ResourceCreationFailed(format!("failed to create compute pipeline: {e:?}"))
    })?;

    Ok(pipelines[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PipelineBindPoint, Rect2d, Viewport};

    fn descriptor() -> PipelineDescriptor {
        PipelineDescriptor {
            label: None,
            bind_point: PipelineBindPoint::Graphics,
            stages: Vec::new(),
            state: Default::default(),
            render_pass: None,
            subpass: 0,
        }
    }

    #[test]
    fn test_missing_viewport_and_scissor_become_dynamic() {
        let flags = effective_dynamic_states(&descriptor());
        assert!(flags.contains(DynamicStateFlags::VIEWPORT | DynamicStateFlags::SCISSOR));
    }

    #[test]
    fn test_static_viewport_stays_static() {
        let mut desc = descriptor();
        desc.state.viewport = Some(Viewport::new(0.0, 0.0, 64.0, 64.0));
        desc.state.scissor = Some(Rect2d::new(0, 0, 64, 64));
        desc.state.dynamic_state = DynamicStateFlags::LINE_WIDTH;
        assert_eq!(effective_dynamic_states(&desc), DynamicStateFlags::LINE_WIDTH);
    }
}
