//! Command pools and forwarding of recorded operations into native command
//! buffers.

use ash::vk;

use super::conversion::*;
use crate::command::{CommandBufferLevel, CommandList, Operation};
use crate::error::{GraphicsError, GraphicsResult};
use crate::types::CommandBufferUsageFlags;

/// Create a command pool whose buffers can be reset individually.
pub fn create_command_pool(
    device: &ash::Device,
    queue_family_index: u32,
) -> GraphicsResult<vk::CommandPool> {
    let pool_info = vk::CommandPoolCreateInfo::default()
        .queue_family_index(queue_family_index)
        .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

    unsafe { device.create_command_pool(&pool_info, None) }.map_err(|e| {
        GraphicsError::InitializationFailed(format!("failed to create command pool: {e:?}"))
    })
}

/// Records `list` into `buffer`, replacing whatever it held.
///
/// Secondary lists executed by the list are expanded inline, so every
/// render pass is recorded with inline subpass contents.
pub fn record_commands(
    device: &ash::Device,
    buffer: vk::CommandBuffer,
    list: &CommandList,
    usage: CommandBufferUsageFlags,
    level: CommandBufferLevel,
) -> GraphicsResult<()> {
    let map_err = |call: &'static str| {
        move |e: vk::Result| GraphicsError::NativeCallFailed {
            call,
            code: e.as_raw() as i64,
        }
    };

    let inheritance = vk::CommandBufferInheritanceInfo::default();
    let mut begin_info =
        vk::CommandBufferBeginInfo::default().flags(convert_command_buffer_usage(usage));
    if level == CommandBufferLevel::Secondary {
        begin_info = begin_info.inheritance_info(&inheritance);
    }

    unsafe {
        device
            .reset_command_buffer(buffer, vk::CommandBufferResetFlags::empty())
            .map_err(map_err("vkResetCommandBuffer"))?;
        device
            .begin_command_buffer(buffer, &begin_info)
            .map_err(map_err("vkBeginCommandBuffer"))?;
    }

    record_list(device, buffer, list);

    unsafe { device.end_command_buffer(buffer) }.map_err(map_err("vkEndCommandBuffer"))
}

fn record_list(device: &ash::Device, cmd: vk::CommandBuffer, list: &CommandList) {
    for operation in list {
        record_operation(device, cmd, operation);
    }
}

fn record_operation(device: &ash::Device, cmd: vk::CommandBuffer, operation: &Operation) {
    // SAFETY: every handle is owned by a resource the operation keeps alive,
    // and `cmd` is in the recording state.
    unsafe {
        match operation {
            Operation::BeginRenderPass {
                render_pass,
                framebuffer,
                render_area,
                clear_values,
                ..
            } => {
                let clear_values: Vec<vk::ClearValue> =
                    clear_values.iter().map(convert_clear_value).collect();
                let info = vk::RenderPassBeginInfo::default()
                    .render_pass(render_pass.gpu.vk_render_pass())
                    .framebuffer(framebuffer.gpu.vk_handle())
                    .render_area(convert_rect(render_area))
                    .clear_values(&clear_values);
                device.cmd_begin_render_pass(cmd, &info, vk::SubpassContents::INLINE);
            }
            Operation::NextSubpass { .. } => {
                device.cmd_next_subpass(cmd, vk::SubpassContents::INLINE);
            }
            Operation::EndRenderPass => device.cmd_end_render_pass(cmd),
            Operation::BindPipeline { pipeline } => {
                device.cmd_bind_pipeline(
                    cmd,
                    convert_bind_point(pipeline.bind_point()),
                    pipeline.gpu.vk_handle(),
                );
            }
            Operation::BindVertexBuffers {
                first_binding,
                buffers,
            } => {
                let handles: Vec<vk::Buffer> =
                    buffers.iter().map(|(b, _)| b.gpu.vk_handle()).collect();
                let offsets: Vec<u64> = buffers.iter().map(|(_, offset)| *offset).collect();
                device.cmd_bind_vertex_buffers(cmd, *first_binding, &handles, &offsets);
            }
            Operation::BindIndexBuffer {
                buffer,
                offset,
                index_type,
            } => device.cmd_bind_index_buffer(
                cmd,
                buffer.gpu.vk_handle(),
                *offset,
                convert_index_type(*index_type),
            ),
            Operation::BindDescriptorSets {
                bind_point,
                layout,
                first_set,
                sets,
                dynamic_offsets,
            } => {
                let sets: Vec<vk::DescriptorSet> =
                    sets.iter().map(|s| s.gpu.vk_descriptor_set()).collect();
                device.cmd_bind_descriptor_sets(
                    cmd,
                    convert_bind_point(*bind_point),
                    layout.gpu.vk_pipeline_layout(),
                    *first_set,
                    &sets,
                    dynamic_offsets,
                );
            }
            Operation::SetViewport(viewport) => {
                device.cmd_set_viewport(cmd, 0, &[convert_viewport(viewport)]);
            }
            Operation::SetScissor(rect) => device.cmd_set_scissor(cmd, 0, &[convert_rect(rect)]),
            Operation::SetLineWidth(width) => device.cmd_set_line_width(cmd, *width),
            Operation::SetDepthBias {
                constant_factor,
                clamp,
                slope_factor,
            } => device.cmd_set_depth_bias(cmd, *constant_factor, *clamp, *slope_factor),
            Operation::SetBlendConstants(constants) => {
                device.cmd_set_blend_constants(cmd, constants);
            }
            Operation::SetStencilReference { faces, reference } => {
                device.cmd_set_stencil_reference(cmd, convert_stencil_faces(*faces), *reference);
            }
            Operation::SetStencilCompareMask { faces, mask } => {
                device.cmd_set_stencil_compare_mask(cmd, convert_stencil_faces(*faces), *mask);
            }
            Operation::SetStencilWriteMask { faces, mask } => {
                device.cmd_set_stencil_write_mask(cmd, convert_stencil_faces(*faces), *mask);
            }
            Operation::Draw {
                vertex_count,
                instance_count,
                first_vertex,
                first_instance,
            } => device.cmd_draw(
                cmd,
                *vertex_count,
                *instance_count,
                *first_vertex,
                *first_instance,
            ),
            Operation::DrawIndexed {
                index_count,
                instance_count,
                first_index,
                vertex_offset,
                first_instance,
            } => device.cmd_draw_indexed(
                cmd,
                *index_count,
                *instance_count,
                *first_index,
                *vertex_offset,
                *first_instance,
            ),
            Operation::DrawIndirect {
                buffer,
                offset,
                draw_count,
                stride,
            } => device.cmd_draw_indirect(cmd, buffer.gpu.vk_handle(), *offset, *draw_count, *stride),
            Operation::DrawIndexedIndirect {
                buffer,
                offset,
                draw_count,
                stride,
            } => device.cmd_draw_indexed_indirect(
                cmd,
                buffer.gpu.vk_handle(),
                *offset,
                *draw_count,
                *stride,
            ),
            Operation::Dispatch { x, y, z } => device.cmd_dispatch(cmd, *x, *y, *z),
            Operation::DispatchIndirect { buffer, offset } => {
                device.cmd_dispatch_indirect(cmd, buffer.gpu.vk_handle(), *offset);
            }
            Operation::ClearColourImage {
                image,
                layout,
                colour,
                ranges,
            } => {
                let ranges: Vec<_> = ranges.iter().map(convert_subresource_range).collect();
                device.cmd_clear_color_image(
                    cmd,
                    image.gpu.vk_handle(),
                    convert_layout(*layout),
                    &convert_clear_colour(colour),
                    &ranges,
                );
            }
            Operation::ClearDepthStencilImage {
                image,
                layout,
                value,
                ranges,
            } => {
                let ranges: Vec<_> = ranges.iter().map(convert_subresource_range).collect();
                device.cmd_clear_depth_stencil_image(
                    cmd,
                    image.gpu.vk_handle(),
                    convert_layout(*layout),
                    &vk::ClearDepthStencilValue {
                        depth: value.depth,
                        stencil: value.stencil,
                    },
                    &ranges,
                );
            }
            Operation::ClearAttachments { attachments, rects } => {
                let attachments: Vec<vk::ClearAttachment> = attachments
                    .iter()
                    .map(|a| vk::ClearAttachment {
                        aspect_mask: convert_aspect(a.aspect_mask),
                        color_attachment: a.colour_attachment,
                        clear_value: convert_clear_value(&a.clear_value),
                    })
                    .collect();
                let rects: Vec<vk::ClearRect> = rects
                    .iter()
                    .map(|r| vk::ClearRect {
                        rect: convert_rect(&r.rect),
                        base_array_layer: r.base_array_layer,
                        layer_count: r.layer_count,
                    })
                    .collect();
                device.cmd_clear_attachments(cmd, &attachments, &rects);
            }
            Operation::CopyBuffer { src, dst, regions } => {
                let regions: Vec<vk::BufferCopy> = regions
                    .iter()
                    .map(|r| vk::BufferCopy {
                        src_offset: r.src_offset,
                        dst_offset: r.dst_offset,
                        size: r.size,
                    })
                    .collect();
                device.cmd_copy_buffer(cmd, src.gpu.vk_handle(), dst.gpu.vk_handle(), &regions);
            }
            Operation::CopyImage {
                src,
                src_layout,
                dst,
                dst_layout,
                regions,
            } => {
                let regions: Vec<vk::ImageCopy> = regions
                    .iter()
                    .map(|r| vk::ImageCopy {
                        src_subresource: convert_subresource_layers(&r.src_subresource),
                        src_offset: convert_offset_3d(r.src_offset),
                        dst_subresource: convert_subresource_layers(&r.dst_subresource),
                        dst_offset: convert_offset_3d(r.dst_offset),
                        extent: convert_extent_3d(r.extent),
                    })
                    .collect();
                device.cmd_copy_image(
                    cmd,
                    src.gpu.vk_handle(),
                    convert_layout(*src_layout),
                    dst.gpu.vk_handle(),
                    convert_layout(*dst_layout),
                    &regions,
                );
            }
            Operation::CopyBufferToImage {
                src,
                dst,
                dst_layout,
                regions,
            } => {
                let regions: Vec<vk::BufferImageCopy> = regions
                    .iter()
                    .map(|r| vk::BufferImageCopy {
                        buffer_offset: r.buffer_offset,
                        buffer_row_length: r.buffer_row_length,
                        buffer_image_height: r.buffer_image_height,
                        image_subresource: convert_subresource_layers(&r.image_subresource),
                        image_offset: convert_offset_3d(r.image_offset),
                        image_extent: convert_extent_3d(r.image_extent),
                    })
                    .collect();
                device.cmd_copy_buffer_to_image(
                    cmd,
                    src.gpu.vk_handle(),
                    dst.gpu.vk_handle(),
                    convert_layout(*dst_layout),
                    &regions,
                );
            }
            Operation::PipelineBarrier {
                src_stage,
                dst_stage,
                dependency_flags,
                memory,
                buffers,
                images,
            } => {
                let memory: Vec<vk::MemoryBarrier> = memory
                    .iter()
                    .map(|b| {
                        vk::MemoryBarrier::default()
                            .src_access_mask(convert_access(b.src_access))
                            .dst_access_mask(convert_access(b.dst_access))
                    })
                    .collect();
                let buffers: Vec<vk::BufferMemoryBarrier> = buffers
                    .iter()
                    .map(|b| {
                        vk::BufferMemoryBarrier::default()
                            .src_access_mask(convert_access(b.src_access))
                            .dst_access_mask(convert_access(b.dst_access))
                            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                            .buffer(b.buffer.gpu.vk_handle())
                            .offset(b.offset)
                            .size(b.size)
                    })
                    .collect();
                let images: Vec<vk::ImageMemoryBarrier> = images
                    .iter()
                    .map(|b| {
                        vk::ImageMemoryBarrier::default()
                            .src_access_mask(convert_access(b.src_access))
                            .dst_access_mask(convert_access(b.dst_access))
                            .old_layout(convert_layout(b.old_layout))
                            .new_layout(convert_layout(b.new_layout))
                            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                            .image(b.image.gpu.vk_handle())
                            .subresource_range(convert_subresource_range(&b.range))
                    })
                    .collect();
                device.cmd_pipeline_barrier(
                    cmd,
                    convert_pipeline_stages(*src_stage),
                    convert_pipeline_stages(*dst_stage),
                    convert_dependency_flags(*dependency_flags),
                    &memory,
                    &buffers,
                    &images,
                );
            }
            Operation::ResetQueryPool { pool, first, count } => {
                device.cmd_reset_query_pool(cmd, pool.gpu.vk_handle(), *first, *count);
            }
            Operation::BeginQuery { pool, query, flags } => {
                device.cmd_begin_query(cmd, pool.gpu.vk_handle(), *query, convert_query_control(*flags));
            }
            Operation::EndQuery { pool, query } => {
                device.cmd_end_query(cmd, pool.gpu.vk_handle(), *query);
            }
            Operation::WriteTimestamp { stage, pool, query } => {
                device.cmd_write_timestamp(
                    cmd,
                    convert_pipeline_stages(*stage),
                    pool.gpu.vk_handle(),
                    *query,
                );
            }
            Operation::PushConstants { layout, constants } => {
                device.cmd_push_constants(
                    cmd,
                    layout.gpu.vk_pipeline_layout(),
                    convert_shader_stages(constants.stages),
                    constants.offset,
                    &constants.data,
                );
            }
            Operation::ExecuteCommands { lists } => {
                for list in lists {
                    record_list(device, cmd, list);
                }
            }
        }
    }
}
