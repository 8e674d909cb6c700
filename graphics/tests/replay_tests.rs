//! GL replay tests.
//!
//! These tests check the native call sequences the GL backends produce for
//! state that spans several operations: bound pipelines, render passes and
//! descriptor sets.

mod common;

use rstest::rstest;

use std::sync::Arc;

use ashes_graphics::backend::gl::constants::{
    GL_DRAW_INDIRECT_BUFFER, GL_TRIANGLES, GL_UNIFORM_BUFFER,
};
use ashes_graphics::{
    AttachmentDescription, AttachmentReference, BufferUsageFlags, ClearValue,
    DescriptorSetLayoutBinding, DescriptorType, DescriptorWrite, Extent2d, Format, GlCall,
    ImageDescriptor, ImageLayout, ImageUsageFlags, ImageViewDescriptor, Pipeline,
    PipelineBindPoint, Rect2d, RenderPass, RenderPassDescriptor, ShaderSource, ShaderStage,
    ShaderStageFlags, SubpassContents, SubpassDescription, VertexInputRate, VertexInputState,
};
use common::{Backend, TestContext};

const VERTEX_SHADER: &str = "#version 330 core\nvoid main() { gl_Position = vec4(0.0); }\n";
const FRAGMENT_SHADER: &str = "#version 330 core\nout vec4 colour;\nvoid main() { colour = vec4(1.0); }\n";

/// A pipeline reading vec4 attributes at `locations` from vertex binding 0.
fn pipeline_with_attributes(
    ctx: &TestContext,
    render_pass: &Arc<RenderPass>,
    locations: &[u32],
) -> Arc<Pipeline> {
    let vertex_input = locations.iter().fold(
        VertexInputState::default().with_binding(0, 64, VertexInputRate::Vertex),
        |state, &location| state.with_attribute(location, 0, Format::Rgba32Float, location * 16),
    );
    let layout = ctx.device.create_pipeline_layout(&[], &[]).unwrap();
    ctx.device
        .create_graphics_pipeline(&layout, render_pass, 0)
        .with_vertex_input(vertex_input)
        .with_stage(ShaderStage::new(
            ShaderStageFlags::VERTEX,
            ShaderSource::Glsl(VERTEX_SHADER.to_string()),
        ))
        .with_stage(ShaderStage::new(
            ShaderStageFlags::FRAGMENT,
            ShaderSource::Glsl(FRAGMENT_SHADER.to_string()),
        ))
        .finish()
        .unwrap()
}

/// Indirect draws bind the argument buffer only for the draw itself.
#[rstest]
#[case::gl4(Backend::Gl4)]
fn test_indirect_draw_unbinds_argument_buffer(#[case] backend: Backend) {
    let Some(ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };

    let (render_pass, framebuffer) = ctx.create_colour_targets(1, 32, 32);
    let layout = ctx.device.create_pipeline_layout(&[], &[]).unwrap();
    let pipeline = ctx
        .device
        .create_graphics_pipeline(&layout, &render_pass, 0)
        .with_label("indirect")
        .with_stage(ShaderStage::new(
            ShaderStageFlags::VERTEX,
            ShaderSource::Glsl(VERTEX_SHADER.to_string()),
        ))
        .with_stage(ShaderStage::new(
            ShaderStageFlags::FRAGMENT,
            ShaderSource::Glsl(FRAGMENT_SHADER.to_string()),
        ))
        .finish()
        .unwrap();
    let arguments = ctx.create_buffer(64, BufferUsageFlags::INDIRECT);

    let cmd = ctx.record(|cmd| {
        cmd.begin_render_pass(
            &render_pass,
            &framebuffer,
            Rect2d::new(0, 0, 32, 32),
            &[],
            SubpassContents::Inline,
        );
        cmd.bind_pipeline(&pipeline);
        cmd.draw_indirect(&arguments, 16, 2, 16);
        cmd.end_render_pass();
    });
    ctx.take_gl_calls();
    ctx.submit(&[&cmd]).unwrap();

    let calls = ctx.take_gl_calls();
    let draw = calls
        .iter()
        .position(|call| {
            *call
                == GlCall::MultiDrawArraysIndirect {
                    mode: GL_TRIANGLES,
                    offset: 16,
                    draw_count: 2,
                    stride: 16,
                }
        })
        .expect("indirect draw issued");
    assert!(matches!(
        calls[draw - 1],
        GlCall::BindBuffer {
            target: GL_DRAW_INDIRECT_BUFFER,
            buffer
        } if buffer != 0
    ));
    assert_eq!(
        calls[draw + 1],
        GlCall::BindBuffer {
            target: GL_DRAW_INDIRECT_BUFFER,
            buffer: 0
        }
    );
}

/// Descriptor bindings map to GL binding points offset by the bases of the
/// earlier sets in the pipeline layout.
#[rstest]
#[case::gl3(Backend::Gl3)]
#[case::gl4(Backend::Gl4)]
fn test_descriptor_sets_bind_offset_binding_points(#[case] backend: Backend) {
    let Some(ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };

    let uniform = |binding| {
        DescriptorSetLayoutBinding::new(
            binding,
            DescriptorType::UniformBuffer,
            ShaderStageFlags::VERTEX,
        )
    };
    let first_layout = ctx
        .device
        .create_descriptor_set_layout(&[uniform(0), uniform(1)])
        .unwrap();
    let second_layout = ctx
        .device
        .create_descriptor_set_layout(&[uniform(0)])
        .unwrap();
    let layout = ctx
        .device
        .create_pipeline_layout(&[first_layout.clone(), second_layout.clone()], &[])
        .unwrap();
    assert_eq!(layout.binding_base(1), 2);

    let buffer = ctx.create_buffer(256, BufferUsageFlags::UNIFORM);
    let first = ctx.device.create_descriptor_set(&first_layout).unwrap();
    first
        .update(&[DescriptorWrite::buffer(1, &buffer, 0, 64)])
        .unwrap();
    let second = ctx.device.create_descriptor_set(&second_layout).unwrap();
    second
        .update(&[DescriptorWrite::buffer(0, &buffer, 128, 32)])
        .unwrap();

    let cmd = ctx.record(|cmd| {
        cmd.bind_descriptor_sets(PipelineBindPoint::Graphics, &layout, 0, &[&first, &second], &[]);
    });
    ctx.take_gl_calls();
    ctx.submit(&[&cmd]).unwrap();

    let ranges: Vec<_> = ctx
        .take_gl_calls()
        .into_iter()
        .filter_map(|call| match call {
            GlCall::BindBufferRange {
                target: GL_UNIFORM_BUFFER,
                index,
                offset,
                size,
                ..
            } => Some((index, offset, size)),
            _ => None,
        })
        .collect();
    assert_eq!(ranges, [(1, 0, 64), (2, 128, 32)]);
}

/// Each element of an arrayed binding gets its own binding point, and the
/// bindings after the array start past its last element.
#[rstest]
#[case::gl3(Backend::Gl3)]
#[case::gl4(Backend::Gl4)]
fn test_array_binding_elements_get_distinct_points(#[case] backend: Backend) {
    let Some(ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };

    let set_layout = ctx
        .device
        .create_descriptor_set_layout(&[
            DescriptorSetLayoutBinding::new(
                0,
                DescriptorType::UniformBuffer,
                ShaderStageFlags::VERTEX,
            )
            .with_count(2),
            DescriptorSetLayoutBinding::new(
                1,
                DescriptorType::UniformBuffer,
                ShaderStageFlags::VERTEX,
            ),
        ])
        .unwrap();
    let layout = ctx
        .device
        .create_pipeline_layout(&[set_layout.clone(), set_layout.clone()], &[])
        .unwrap();
    assert_eq!(layout.binding_base(1), 3);

    let buffer = ctx.create_buffer(1024, BufferUsageFlags::UNIFORM);
    let set = ctx.device.create_descriptor_set(&set_layout).unwrap();
    set.update(&[
        DescriptorWrite::buffer(0, &buffer, 0, 64),
        DescriptorWrite::buffer(0, &buffer, 256, 64).at_element(1),
        DescriptorWrite::buffer(1, &buffer, 512, 64),
    ])
    .unwrap();

    let cmd = ctx.record(|cmd| {
        cmd.bind_descriptor_sets(PipelineBindPoint::Graphics, &layout, 0, &[&set, &set], &[]);
    });
    ctx.take_gl_calls();
    ctx.submit(&[&cmd]).unwrap();

    let points: Vec<_> = ctx
        .take_gl_calls()
        .into_iter()
        .filter_map(|call| match call {
            GlCall::BindBufferRange {
                target: GL_UNIFORM_BUFFER,
                index,
                offset,
                ..
            } => Some((index, offset)),
            _ => None,
        })
        .collect();
    assert_eq!(
        points,
        [(0, 0), (1, 256), (2, 512), (3, 0), (4, 256), (5, 512)]
    );
}

/// Attribute arrays a previous pipeline enabled are disabled when the next
/// pipeline does not read them.
#[rstest]
#[case::gl3(Backend::Gl3)]
#[case::gl4(Backend::Gl4)]
fn test_unused_vertex_attributes_are_disabled(#[case] backend: Backend) {
    let Some(ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };

    let (render_pass, framebuffer) = ctx.create_colour_targets(1, 16, 16);
    let wide = pipeline_with_attributes(&ctx, &render_pass, &[0, 1, 2]);
    let narrow = pipeline_with_attributes(&ctx, &render_pass, &[0]);
    let vertices = ctx.create_buffer(256, BufferUsageFlags::VERTEX);

    let cmd = ctx.record(|cmd| {
        cmd.begin_render_pass(
            &render_pass,
            &framebuffer,
            Rect2d::new(0, 0, 16, 16),
            &[],
            SubpassContents::Inline,
        );
        cmd.bind_vertex_buffers(0, &[(&vertices, 0)]);
        cmd.bind_pipeline(&wide);
        cmd.draw(3, 1, 0, 0);
        cmd.bind_pipeline(&narrow);
        cmd.draw(3, 1, 0, 0);
        cmd.end_render_pass();
    });
    ctx.take_gl_calls();
    ctx.submit(&[&cmd]).unwrap();

    let toggles: Vec<_> = ctx
        .take_gl_calls()
        .into_iter()
        .filter(|call| {
            matches!(
                call,
                GlCall::EnableVertexAttribArray(_) | GlCall::DisableVertexAttribArray(_)
            )
        })
        .collect();
    assert_eq!(
        toggles,
        [
            GlCall::EnableVertexAttribArray(0),
            GlCall::EnableVertexAttribArray(1),
            GlCall::EnableVertexAttribArray(2),
            GlCall::DisableVertexAttribArray(1),
            GlCall::DisableVertexAttribArray(2),
            GlCall::EnableVertexAttribArray(0),
        ]
    );
}

/// A clear value of the wrong kind for its attachment clears nothing.
#[rstest]
#[case::gl3(Backend::Gl3)]
#[case::gl4(Backend::Gl4)]
fn test_mismatched_clear_value_is_skipped(#[case] backend: Backend) {
    let Some(ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };

    let layout = ImageLayout::ColourAttachmentOptimal;
    let render_pass = ctx
        .device
        .create_render_pass(&RenderPassDescriptor::new(
            vec![AttachmentDescription::cleared(Format::Rgba8Unorm, layout)],
            vec![SubpassDescription::new(vec![AttachmentReference::new(0, layout)])],
        ))
        .unwrap();
    let image = ctx
        .device
        .create_image(&ImageDescriptor::new_2d(
            16,
            16,
            Format::Rgba8Unorm,
            ImageUsageFlags::COLOR_ATTACHMENT,
        ))
        .unwrap();
    let view = ctx
        .device
        .create_image_view(&image, &ImageViewDescriptor::new())
        .unwrap();
    let framebuffer = ctx
        .device
        .create_framebuffer(&render_pass, &[view], Extent2d::new(16, 16), 1)
        .unwrap();

    let cmd = ctx.record(|cmd| {
        cmd.begin_render_pass(
            &render_pass,
            &framebuffer,
            Rect2d::new(0, 0, 16, 16),
            &[ClearValue::depth_stencil(1.0, 0)],
            SubpassContents::Inline,
        );
        cmd.end_render_pass();
    });
    ctx.take_gl_calls();
    ctx.submit(&[&cmd]).unwrap();

    assert!(!ctx.take_gl_calls().iter().any(|call| matches!(
        call,
        GlCall::ClearBufferfv { .. } | GlCall::ClearBufferfi { .. } | GlCall::ClearBufferiv { .. }
    )));
    assert_eq!(ctx.device.executed_operation_count(), 2);
}
