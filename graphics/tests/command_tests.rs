//! Command recording and submission tests.
//!
//! These tests drive the public API the way a renderer does: record command
//! buffers, submit them, and observe what each backend executed. Tests are
//! parameterized using `rstest` to run against multiple backends.
//!
//! # Test Categories
//!
//! - **Submission Tests**: executed operation counts and ordering
//! - **Replay Tests**: the GL calls produced by recorded operations
//! - **Failure Tests**: invalid submissions, lost devices, swap chain failures
//!
//! # Running Tests
//!
//! ```bash
//! cargo test --test command_tests
//!
//! # Include the native Vulkan cases
//! cargo test --test command_tests --features vulkan-backend
//! ```
//!
//! The Vulkan cases skip themselves when no driver is installed.

mod common;

use std::sync::Arc;

use rstest::rstest;

use ashes_graphics::{
    BufferCopy, ClearAttachment, ClearRect, ClearValue, CommandBufferLevel,
    CommandBufferState, CommandBufferUsageFlags, ConstantFormat, Format, GlCall, GraphicsError,
    ImageAspectFlags, PresentInfo, PushConstant, PushConstantRange, PushConstantsDesc, Rect2d,
    ShaderStageFlags, SubmitInfo, SubpassContents, SwapChainDescriptor,
};
use common::{generate_test_pattern, Backend, TestContext};

/// GL calls that only the dynamic-state operations below produce.
fn dynamic_state_calls(calls: Vec<GlCall>) -> Vec<GlCall> {
    calls
        .into_iter()
        .filter(|call| matches!(call, GlCall::LineWidth(_) | GlCall::BlendColor(_)))
        .collect()
}

// ============================================================================
// Submission Tests
// ============================================================================

/// A command buffer that is reset, begun and ended executes nothing.
#[rstest]
#[case::test(Backend::Test)]
#[case::gl3(Backend::Gl3)]
#[case::gl4(Backend::Gl4)]
#[case::vulkan(Backend::Vulkan)]
fn test_empty_submission_executes_nothing(#[case] backend: Backend) {
    let Some(ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };

    let mut cmd = ctx.command_buffer(CommandBufferLevel::Primary);
    cmd.reset().unwrap();
    cmd.begin(CommandBufferUsageFlags::ONE_TIME_SUBMIT).unwrap();
    cmd.end().unwrap();
    assert_eq!(cmd.state(), CommandBufferState::Executable);

    ctx.submit_and_wait(&[&cmd]);
    assert_eq!(ctx.device.executed_operation_count(), 0);
    assert!(ctx.device.executed_operation_names().is_empty());
}

/// Operations run exactly once each, in record order.
#[rstest]
#[case::test(Backend::Test)]
#[case::gl3(Backend::Gl3)]
#[case::gl4(Backend::Gl4)]
fn test_operations_replay_in_record_order(#[case] backend: Backend) {
    let Some(ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };

    let cmd = ctx.record(|cmd| {
        cmd.set_line_width(1.0);
        cmd.set_blend_constants([0.5; 4]);
        cmd.set_line_width(2.0);
    });
    ctx.take_gl_calls();
    ctx.submit(&[&cmd]).unwrap();

    assert_eq!(ctx.device.executed_operation_count(), 3);
    match backend {
        Backend::Test => assert_eq!(
            ctx.device.executed_operation_names(),
            ["SetLineWidth", "SetBlendConstants", "SetLineWidth"]
        ),
        _ => assert_eq!(
            dynamic_state_calls(ctx.take_gl_calls()),
            vec![
                GlCall::LineWidth(1.0),
                GlCall::BlendColor([0.5; 4]),
                GlCall::LineWidth(2.0),
            ]
        ),
    }
}

/// Command buffers of one batch execute in array order.
#[rstest]
#[case::test(Backend::Test)]
#[case::gl4(Backend::Gl4)]
fn test_batch_runs_buffers_in_order(#[case] backend: Backend) {
    let Some(ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };

    let first = ctx.record(|cmd| cmd.set_line_width(3.0));
    let second = ctx.record(|cmd| cmd.set_blend_constants([0.25; 4]));
    ctx.take_gl_calls();
    ctx.submit(&[&first, &second]).unwrap();

    assert_eq!(ctx.device.executed_operation_count(), 2);
    match backend {
        Backend::Test => assert_eq!(
            ctx.device.executed_operation_names(),
            ["SetLineWidth", "SetBlendConstants"]
        ),
        _ => assert_eq!(
            dynamic_state_calls(ctx.take_gl_calls()),
            vec![GlCall::LineWidth(3.0), GlCall::BlendColor([0.25; 4])]
        ),
    }
}

/// Batches of one submission execute in array order, and resubmission
/// repeats the recorded work.
#[rstest]
#[case::test(Backend::Test)]
#[case::gl3(Backend::Gl3)]
fn test_batches_and_resubmission(#[case] backend: Backend) {
    let Some(ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };

    let first = ctx.record(|cmd| cmd.set_line_width(4.0));
    let second = ctx.record(|cmd| cmd.set_line_width(5.0));
    let queue = ctx.device.graphics_queue();
    queue
        .submit(
            &[SubmitInfo::new(&[&second]), SubmitInfo::new(&[&first])],
            None,
        )
        .unwrap();
    queue.submit(&[SubmitInfo::new(&[&second])], None).unwrap();

    assert_eq!(ctx.device.executed_operation_count(), 3);
    if backend != Backend::Test {
        assert_eq!(
            dynamic_state_calls(ctx.take_gl_calls()),
            vec![
                GlCall::LineWidth(5.0),
                GlCall::LineWidth(4.0),
                GlCall::LineWidth(5.0),
            ]
        );
    }
}

/// Secondary command buffers run inline; each of their operations counts
/// along with the `ExecuteCommands` that runs them.
#[rstest]
#[case::test(Backend::Test)]
#[case::gl4(Backend::Gl4)]
fn test_secondary_operations_are_counted(#[case] backend: Backend) {
    let Some(ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };

    let mut secondary = ctx.command_buffer(CommandBufferLevel::Secondary);
    secondary.begin(CommandBufferUsageFlags::empty()).unwrap();
    secondary.set_line_width(6.0);
    secondary.set_blend_constants([1.0; 4]);
    secondary.end().unwrap();

    let primary = ctx.record(|cmd| {
        cmd.execute_commands(&[&secondary]);
        cmd.set_line_width(7.0);
    });
    ctx.take_gl_calls();
    ctx.submit(&[&primary]).unwrap();

    assert_eq!(ctx.device.executed_operation_count(), 4);
    match backend {
        Backend::Test => assert_eq!(
            ctx.device.executed_operation_names(),
            [
                "ExecuteCommands",
                "SetLineWidth",
                "SetBlendConstants",
                "SetLineWidth"
            ]
        ),
        _ => assert_eq!(
            dynamic_state_calls(ctx.take_gl_calls()),
            vec![
                GlCall::LineWidth(6.0),
                GlCall::BlendColor([1.0; 4]),
                GlCall::LineWidth(7.0),
            ]
        ),
    }
}

/// Bytes written on the host arrive unchanged in the copy destination.
#[rstest]
#[case::test(Backend::Test)]
#[case::gl3(Backend::Gl3)]
#[case::gl4(Backend::Gl4)]
#[case::vulkan(Backend::Vulkan)]
fn test_buffer_copy_roundtrip(#[case] backend: Backend) {
    let Some(ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };

    const BUFFER_SIZE: u64 = 256;
    let pattern = generate_test_pattern(BUFFER_SIZE as usize);
    let staging = ctx.create_host_buffer(BUFFER_SIZE);
    let readback = ctx.create_host_buffer(BUFFER_SIZE);
    staging.write(0, &pattern).unwrap();

    let cmd = ctx.record(|cmd| {
        cmd.copy_buffer(&staging, &readback, &[BufferCopy::new(0, 0, BUFFER_SIZE)]);
    });
    ctx.submit_and_wait(&[&cmd]);

    assert_eq!(readback.read(0, BUFFER_SIZE).unwrap(), pattern);
    assert_eq!(ctx.device.executed_operation_count(), 1);
}

/// A partial copy moves only the requested range.
#[rstest]
#[case::test(Backend::Test)]
#[case::gl4(Backend::Gl4)]
#[case::vulkan(Backend::Vulkan)]
fn test_buffer_copy_partial(#[case] backend: Backend) {
    let Some(ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };

    let src = ctx.create_host_buffer(16);
    let dst = ctx.create_host_buffer(16);
    src.write(0, &[0xAB; 16]).unwrap();
    dst.write(0, &[0; 16]).unwrap();

    let cmd = ctx.record(|cmd| cmd.copy_buffer(&src, &dst, &[BufferCopy::new(4, 8, 4)]));
    ctx.submit_and_wait(&[&cmd]);

    let mut expected = vec![0u8; 16];
    expected[8..12].fill(0xAB);
    assert_eq!(dst.read(0, 16).unwrap(), expected);
}

// ============================================================================
// Replay Tests
// ============================================================================

/// `ClearAttachments` with two attachments and one rect is one operation
/// clearing both attachments inside the rect.
#[rstest]
#[case::test(Backend::Test)]
#[case::gl3(Backend::Gl3)]
#[case::gl4(Backend::Gl4)]
fn test_clear_attachments_is_one_operation(#[case] backend: Backend) {
    let Some(ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };

    let (render_pass, framebuffer) = ctx.create_colour_targets(2, 64, 64);
    let clear = |index| ClearAttachment {
        aspect_mask: ImageAspectFlags::COLOR,
        colour_attachment: index,
        clear_value: ClearValue::colour(0.25, 0.5, 0.75, 1.0),
    };
    let rect = ClearRect {
        rect: Rect2d::new(8, 8, 16, 16),
        base_array_layer: 0,
        layer_count: 1,
    };
    let cmd = ctx.record(|cmd| {
        cmd.begin_render_pass(
            &render_pass,
            &framebuffer,
            Rect2d::new(0, 0, 64, 64),
            &[],
            SubpassContents::Inline,
        );
        cmd.clear_attachments(&[clear(0), clear(1)], &[rect]);
        cmd.end_render_pass();
    });
    ctx.take_gl_calls();
    ctx.submit(&[&cmd]).unwrap();

    assert_eq!(ctx.device.executed_operation_count(), 3);
    if backend == Backend::Test {
        assert_eq!(
            ctx.device.executed_operation_names(),
            ["BeginRenderPass", "ClearAttachments", "EndRenderPass"]
        );
        return;
    }

    let calls = ctx.take_gl_calls();
    assert!(calls.contains(&GlCall::Scissor {
        x: 8,
        y: 8,
        width: 16,
        height: 16
    }));
    let cleared: Vec<_> = calls
        .iter()
        .filter_map(|call| match call {
            GlCall::ClearBufferfv {
                draw_buffer,
                values,
                ..
            } if values == &[0.25, 0.5, 0.75, 1.0] => Some(*draw_buffer),
            _ => None,
        })
        .collect();
    assert_eq!(cleared, [0, 1]);
}

/// A secondary begun to continue a render pass clears attachments of the
/// primary's subpass.
#[rstest]
#[case::test(Backend::Test)]
#[case::gl3(Backend::Gl3)]
#[case::gl4(Backend::Gl4)]
fn test_render_pass_continue_secondary_clears(#[case] backend: Backend) {
    let Some(ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };

    let (render_pass, framebuffer) = ctx.create_colour_targets(1, 32, 32);
    let mut secondary = ctx.command_buffer(CommandBufferLevel::Secondary);
    secondary
        .begin(CommandBufferUsageFlags::RENDER_PASS_CONTINUE)
        .unwrap();
    secondary.clear_attachments(
        &[ClearAttachment {
            aspect_mask: ImageAspectFlags::COLOR,
            colour_attachment: 0,
            clear_value: ClearValue::colour(1.0, 0.0, 0.0, 1.0),
        }],
        &[ClearRect {
            rect: Rect2d::new(0, 0, 8, 8),
            base_array_layer: 0,
            layer_count: 1,
        }],
    );
    secondary.end().unwrap();
    assert_eq!(secondary.state(), CommandBufferState::Executable);

    let primary = ctx.record(|cmd| {
        cmd.begin_render_pass(
            &render_pass,
            &framebuffer,
            Rect2d::new(0, 0, 32, 32),
            &[],
            SubpassContents::SecondaryCommandBuffers,
        );
        cmd.execute_commands(&[&secondary]);
        cmd.end_render_pass();
    });
    ctx.take_gl_calls();
    ctx.submit(&[&primary]).unwrap();

    assert_eq!(ctx.device.executed_operation_count(), 4);
    if backend == Backend::Test {
        assert_eq!(
            ctx.device.executed_operation_names(),
            [
                "BeginRenderPass",
                "ExecuteCommands",
                "ClearAttachments",
                "EndRenderPass"
            ]
        );
    } else {
        let cleared = ctx
            .take_gl_calls()
            .into_iter()
            .filter(|call| {
                matches!(call, GlCall::ClearBufferfv { values, .. } if values == &[1.0, 0.0, 0.0, 1.0])
            })
            .count();
        assert_eq!(cleared, 1);
    }
}

/// Push constants are uploaded one uniform per constant, each reading its
/// own offset of the data.
#[rstest]
#[case::gl3(Backend::Gl3)]
#[case::gl4(Backend::Gl4)]
fn test_push_constants_upload_each_constant(#[case] backend: Backend) {
    let Some(ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };

    let layout = ctx
        .device
        .create_pipeline_layout(
            &[],
            &[PushConstantRange {
                stages: ShaderStageFlags::VERTEX,
                offset: 0,
                size: 20,
            }],
        )
        .unwrap();

    let mut data = Vec::new();
    data.extend_from_slice(&2.0f32.to_ne_bytes());
    for value in [1.0f32, 2.0, 3.0, 4.0] {
        data.extend_from_slice(&value.to_ne_bytes());
    }
    let constants = PushConstantsDesc {
        stages: ShaderStageFlags::VERTEX,
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
    let cmd = ctx.record(|cmd| cmd.push_constants(&layout, constants));
    ctx.take_gl_calls();
    ctx.submit(&[&cmd]).unwrap();

    let uploads: Vec<_> = ctx
        .take_gl_calls()
        .into_iter()
        .filter(|call| matches!(call, GlCall::Uniform1fv { .. } | GlCall::Uniform4fv { .. }))
        .collect();
    assert_eq!(
        uploads,
        vec![
            GlCall::Uniform1fv {
                location: 0,
                values: vec![2.0]
            },
            GlCall::Uniform4fv {
                location: 4,
                values: vec![1.0, 2.0, 3.0, 4.0]
            },
        ]
    );
    assert_eq!(ctx.device.executed_operation_count(), 1);
}

// ============================================================================
// Failure Tests
// ============================================================================

/// A command buffer still recording cannot be submitted, and the batch it
/// belongs to executes nothing.
#[rstest]
#[case::test(Backend::Test)]
#[case::gl4(Backend::Gl4)]
#[case::vulkan(Backend::Vulkan)]
fn test_submitting_recording_buffer_fails(#[case] backend: Backend) {
    let Some(ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };

    let ready = ctx.record(|cmd| cmd.set_line_width(1.0));
    let mut recording = ctx.command_buffer(CommandBufferLevel::Primary);
    recording.begin(CommandBufferUsageFlags::empty()).unwrap();
    recording.set_line_width(2.0);
    assert_eq!(recording.state(), CommandBufferState::Recording);
    ctx.take_gl_calls();

    let result = ctx.submit(&[&ready, &recording]);
    assert!(matches!(result, Err(GraphicsError::InvalidState(_))));
    assert_eq!(ctx.device.executed_operation_count(), 0);
    assert!(ctx.take_gl_calls().is_empty());
    assert_eq!(ready.state(), CommandBufferState::Executable);
}

/// Work still running on the device keeps its recorded operations alive;
/// once the device is idle the command buffer can be recorded again.
#[rstest]
#[case::test(Backend::Test)]
#[case::gl4(Backend::Gl4)]
#[case::vulkan(Backend::Vulkan)]
fn test_submission_holds_operations_until_idle(#[case] backend: Backend) {
    let Some(ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };

    let src = ctx.create_host_buffer(256);
    let dst = ctx.create_host_buffer(256);
    let mut cmd = ctx.record(|cmd| cmd.copy_buffer(&src, &dst, &[BufferCopy::new(0, 0, 256)]));
    let operations = cmd.commands();
    ctx.submit(&[&cmd]).unwrap();

    // Held by the command buffer and `operations`, plus the in-flight
    // submission on Vulkan.
    let held = Arc::strong_count(&operations);
    match backend {
        Backend::Vulkan => assert_eq!(held, 3),
        _ => assert_eq!(held, 2),
    }

    ctx.device.wait_idle().unwrap();
    assert_eq!(Arc::strong_count(&operations), 2);
    assert_eq!(cmd.state(), CommandBufferState::Executable);
    cmd.begin(CommandBufferUsageFlags::empty()).unwrap();
    cmd.end().unwrap();
}

/// Secondary command buffers are only submitted through a primary.
#[rstest]
#[case::test(Backend::Test)]
#[case::gl3(Backend::Gl3)]
fn test_submitting_secondary_buffer_fails(#[case] backend: Backend) {
    let Some(ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };

    let mut secondary = ctx.command_buffer(CommandBufferLevel::Secondary);
    secondary.begin(CommandBufferUsageFlags::empty()).unwrap();
    secondary.end().unwrap();

    let result = ctx.submit(&[&secondary]);
    assert!(matches!(result, Err(GraphicsError::InvalidState(_))));
}

/// Once the context is lost, submissions fail fast without replaying.
#[rstest]
#[case::gl3(Backend::Gl3)]
#[case::gl4(Backend::Gl4)]
fn test_lost_device_fails_fast(#[case] backend: Backend) {
    let Some(ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };
    let gl = ctx.gl.clone().expect("GL backends record their calls");

    let cmd = ctx.record(|cmd| cmd.set_line_width(1.0));
    ctx.submit(&[&cmd]).unwrap();
    assert_eq!(ctx.device.executed_operation_count(), 1);

    gl.lose_context();
    let result = ctx.submit(&[&cmd]);
    assert!(matches!(result, Err(GraphicsError::DeviceLost)));
    assert!(ctx.device.is_lost());

    gl.clear_calls();
    let again = ctx.record(|cmd| cmd.set_line_width(2.0));
    assert!(matches!(
        ctx.submit(&[&again]),
        Err(GraphicsError::DeviceLost)
    ));
    assert!(gl.calls().is_empty());
    assert!(matches!(
        ctx.device.wait_idle(),
        Err(GraphicsError::DeviceLost)
    ));
    assert_eq!(ctx.device.executed_operation_count(), 1);
}

/// A swap chain that cannot be created yields `None` instead of an error.
#[rstest]
#[case::test(Backend::Test)]
#[case::gl3(Backend::Gl3)]
#[case::gl4(Backend::Gl4)]
#[case::vulkan(Backend::Vulkan)]
fn test_swap_chain_failure_yields_none(#[case] backend: Backend) {
    let Some(ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };

    let degenerate = SwapChainDescriptor::new(0, 480, Format::Bgra8Unorm);
    assert!(ctx.device.create_swap_chain(&degenerate).is_none());

    let no_images = SwapChainDescriptor::new(640, 480, Format::Bgra8Unorm).with_image_count(0);
    assert!(ctx.device.create_swap_chain(&no_images).is_none());
}

/// Presenting an acquired swap chain image reaches the platform.
#[rstest]
#[case::test(Backend::Test)]
#[case::gl4(Backend::Gl4)]
fn test_present_swap_chain(#[case] backend: Backend) {
    let Some(ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };

    let swap_chain: Arc<_> = ctx
        .device
        .create_swap_chain(&SwapChainDescriptor::new(32, 32, Format::Rgba8Unorm))
        .expect("swap chain");
    let acquired = ctx.device.create_semaphore().unwrap();
    let index = swap_chain
        .acquire_next_image(std::time::Duration::from_secs(1), Some(&*acquired), None)
        .unwrap();

    ctx.device
        .present_queue()
        .present(&PresentInfo::new(&swap_chain, index).with_wait(&acquired))
        .unwrap();

    match &ctx.platform {
        Some(platform) => assert_eq!(platform.swap_count(), 1),
        None => assert_eq!(ctx.device.present_count(), 1),
    }
}
