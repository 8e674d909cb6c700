//! Queues: submission and presentation.

use std::sync::Arc;

use super::buffer::CommandBuffer;
use super::operation::CommandList;
use crate::device::GraphicsDevice;
use crate::error::{GraphicsError, GraphicsResult};
use crate::resources::{Fence, Semaphore, SwapChain};
use crate::types::PipelineStageFlags;

/// One batch of a queue submission.
#[derive(Debug, Default)]
pub struct SubmitInfo<'a> {
    /// Semaphores waited on before the first command, with the stages that wait.
    pub wait_semaphores: Vec<(&'a Semaphore, PipelineStageFlags)>,
    pub command_buffers: Vec<&'a CommandBuffer>,
    /// Semaphores signaled after the last command.
    pub signal_semaphores: Vec<&'a Semaphore>,
}

impl<'a> SubmitInfo<'a> {
    /// A batch of command buffers without semaphores.
    pub fn new(command_buffers: &[&'a CommandBuffer]) -> Self {
        Self {
            wait_semaphores: Vec::new(),
            command_buffers: command_buffers.to_vec(),
            signal_semaphores: Vec::new(),
        }
    }

    /// Wait on `semaphore` before `stage`.
    pub fn with_wait(mut self, semaphore: &'a Semaphore, stage: PipelineStageFlags) -> Self {
        self.wait_semaphores.push((semaphore, stage));
        self
    }

    /// Signal `semaphore` once the batch completes.
    pub fn with_signal(mut self, semaphore: &'a Semaphore) -> Self {
        self.signal_semaphores.push(semaphore);
        self
    }
}

/// Swap chain images to present.
#[derive(Debug, Default)]
pub struct PresentInfo<'a> {
    pub wait_semaphores: Vec<&'a Semaphore>,
    /// Swap chains and the acquired image index of each.
    pub swap_chains: Vec<(&'a SwapChain, u32)>,
}

impl<'a> PresentInfo<'a> {
    /// Present image `index` of `swap_chain`.
    pub fn new(swap_chain: &'a SwapChain, index: u32) -> Self {
        Self {
            wait_semaphores: Vec::new(),
            swap_chains: vec![(swap_chain, index)],
        }
    }

    /// Wait on `semaphore` before presenting.
    pub fn with_wait(mut self, semaphore: &'a Semaphore) -> Self {
        self.wait_semaphores.push(semaphore);
        self
    }
}

/// A submit batch with the lists captured from its command buffers.
pub(crate) struct SubmitBatch<'a> {
    pub(crate) info: &'a SubmitInfo<'a>,
    pub(crate) lists: Vec<Arc<CommandList>>,
}

impl SubmitBatch<'_> {
    /// Consumes the wait semaphores of an emulated backend.
    pub(crate) fn wait_emulated(&self) {
        for (semaphore, _) in &self.info.wait_semaphores {
            if !semaphore.consume_emulated() {
                log::warn!("Queue: waiting on a semaphore that was never signaled");
            }
        }
    }

    /// Signals the signal semaphores of an emulated backend.
    pub(crate) fn signal_emulated(&self) {
        for semaphore in &self.info.signal_semaphores {
            semaphore.signal_emulated();
        }
    }
}

/// What a backend reports for an accepted submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Submitted {
    pub(crate) executed: u64,
    /// Serial of work that is still running when `submit` returns.
    pub(crate) in_flight: Option<u64>,
}

impl Submitted {
    /// A submission that finished executing before returning.
    pub(crate) fn completed(executed: u64) -> Self {
        Self {
            executed,
            in_flight: None,
        }
    }
}

/// A device queue.
///
/// All queues of a device share one submission lock; batches execute in
/// submission order.
#[derive(Debug, Clone)]
pub struct Queue {
    device: Arc<GraphicsDevice>,
    family_index: u32,
}

impl Queue {
    pub(crate) fn new(device: Arc<GraphicsDevice>, family_index: u32) -> Self {
        Self {
            device,
            family_index,
        }
    }

    /// Queue family the queue belongs to.
    pub fn family_index(&self) -> u32 {
        self.family_index
    }

    /// The owning device.
    pub fn device(&self) -> &Arc<GraphicsDevice> {
        &self.device
    }

    /// Submits batches of command buffers.
    ///
    /// Every command buffer is validated before anything executes. Batches
    /// then run in array order, each command buffer's operations in record
    /// order. `fence` is signaled after the last batch.
    ///
    /// On Vulkan the work may still be running when this returns; the
    /// submitted command buffers stay [`Pending`](super::CommandBufferState::Pending)
    /// until it finishes, and the resources they reference stay alive.
    ///
    /// # Errors
    ///
    /// - [`GraphicsError::DeviceLost`] if the device is (or becomes) lost.
    ///   Operations already applied are not rolled back.
    /// - [`GraphicsError::InvalidState`] if a command buffer is not
    ///   executable; nothing is executed in that case.
    pub fn submit(&self, submits: &[SubmitInfo<'_>], fence: Option<&Fence>) -> GraphicsResult<()> {
        let device = &self.device;
        if device.is_lost() {
            return Err(GraphicsError::DeviceLost);
        }
        let _submit = device.submit_lock.lock();

        for info in submits {
            for buffer in &info.command_buffers {
                buffer.check_submittable(device.id())?;
            }
            for (semaphore, _) in &info.wait_semaphores {
                assert_eq!(semaphore.device_id(), device.id(), "semaphore belongs to another device");
            }
            for semaphore in &info.signal_semaphores {
                assert_eq!(semaphore.device_id(), device.id(), "semaphore belongs to another device");
            }
        }
        if let Some(fence) = fence {
            assert_eq!(fence.device_id(), device.id(), "fence belongs to another device");
        }

        let batches: Vec<SubmitBatch<'_>> = submits
            .iter()
            .map(|info| SubmitBatch {
                info,
                lists: info
                    .command_buffers
                    .iter()
                    .map(|buffer| buffer.begin_submit())
                    .collect(),
            })
            .collect();

        let result = device.backend_submit(&batches, fence);
        let lost = matches!(result, Err(GraphicsError::DeviceLost));
        let in_flight = result.as_ref().ok().and_then(|submitted| submitted.in_flight);
        for info in submits {
            for buffer in &info.command_buffers {
                buffer.finish_submit(lost, in_flight);
            }
        }

        match result {
            Ok(Submitted { executed, .. }) => {
                device.record_executed(executed);
                log::trace!(
                    "Queue: submitted {} batches, {executed} operations",
                    submits.len()
                );
                Ok(())
            }
            Err(e) => {
                if e.is_device_lost() {
                    device.mark_lost();
                }
                Err(e)
            }
        }
    }

    /// Presents swap chain images.
    pub fn present(&self, info: &PresentInfo<'_>) -> GraphicsResult<()> {
        let device = &self.device;
        if device.is_lost() {
            return Err(GraphicsError::DeviceLost);
        }
        for (swap_chain, index) in &info.swap_chains {
            assert_eq!(swap_chain.device_id(), device.id(), "swap chain belongs to another device");
            assert!(
                (*index as usize) < swap_chain.images().len(),
                "swap chain has no image {index}"
            );
        }
        let _submit = device.submit_lock.lock();
        let result = device.backend_present(info);
        if let Err(e) = &result {
            if e.is_device_lost() {
                device.mark_lost();
            }
        }
        result
    }

    /// Blocks until all submitted work has finished.
    pub fn wait_idle(&self) -> GraphicsResult<()> {
        self.device.wait_idle()
    }
}
