//! Tracking of submissions the GPU has not finished yet.
//!
//! `vkQueueSubmit` returns as soon as the work is queued. Every submission
//! gets a serial and an internal fence; until that fence signals, the
//! submitted command lists (and through them every resource they reference)
//! stay alive here, and the command buffers that were submitted stay
//! pending.
//!
//! Serials increase by one per submission and retire in order, since all
//! submissions go to the one graphics queue.

use std::collections::VecDeque;
use std::sync::Arc;

use ash::prelude::VkResult;
use ash::vk;
use parking_lot::Mutex;

use crate::command::CommandList;

struct InFlightSubmission {
    serial: u64,
    fence: vk::Fence,
    lists: Vec<Arc<CommandList>>,
}

#[derive(Default)]
struct TrackerState {
    next_serial: u64,
    completed: u64,
    in_flight: VecDeque<InFlightSubmission>,
    /// Signaled fences of retired submissions, reset before reuse.
    free_fences: Vec<vk::Fence>,
}

impl TrackerState {
    /// Pops the oldest submission, recycling its fence.
    fn retire_front(&mut self) -> Option<Vec<Arc<CommandList>>> {
        let submission = self.in_flight.pop_front()?;
        self.completed = submission.serial;
        self.free_fences.push(submission.fence);
        Some(submission.lists)
    }
}

/// Submissions in flight on one device, oldest first.
#[derive(Default)]
pub(crate) struct SubmissionTracker {
    state: Mutex<TrackerState>,
}

impl SubmissionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fence of a retired submission; it is still signaled.
    pub fn take_fence(&self) -> Option<vk::Fence> {
        self.state.lock().free_fences.pop()
    }

    /// Returns a fence that ended up unused.
    pub fn recycle_fence(&self, fence: vk::Fence) {
        self.state.lock().free_fences.push(fence);
    }

    /// Records a submission signaling `fence` and returns its serial.
    pub fn push(&self, fence: vk::Fence, lists: Vec<Arc<CommandList>>) -> u64 {
        let mut state = self.state.lock();
        state.next_serial += 1;
        let serial = state.next_serial;
        state.in_flight.push_back(InFlightSubmission {
            serial,
            fence,
            lists,
        });
        serial
    }

    /// Serial of the newest retired submission, 0 before the first.
    pub fn completed(&self) -> u64 {
        self.state.lock().completed
    }

    pub fn in_flight_count(&self) -> usize {
        self.state.lock().in_flight.len()
    }

    /// Fence of submission `serial`, `None` once it has retired.
    pub fn fence_of(&self, serial: u64) -> Option<vk::Fence> {
        self.state
            .lock()
            .in_flight
            .iter()
            .find(|submission| submission.serial == serial)
            .map(|submission| submission.fence)
    }

    /// Retires submissions from the oldest while `signaled` reports their
    /// fence signaled, and returns the newest retired serial.
    pub fn retire(&self, mut signaled: impl FnMut(vk::Fence) -> VkResult<bool>) -> VkResult<u64> {
        let mut released = Vec::new();
        let completed = {
            let mut state = self.state.lock();
            while let Some(fence) = state.in_flight.front().map(|submission| submission.fence) {
                if !signaled(fence)? {
                    break;
                }
                released.extend(state.retire_front());
            }
            state.completed
        };
        // Resources are destroyed outside the lock.
        drop(released);
        Ok(completed)
    }

    /// Retires everything; the caller has waited for the device to idle.
    pub fn retire_all(&self) -> u64 {
        let mut released = Vec::new();
        let completed = {
            let mut state = self.state.lock();
            while let Some(lists) = state.retire_front() {
                released.push(lists);
            }
            state.completed
        };
        drop(released);
        completed
    }

    /// Retires everything and hands back every fence for destruction.
    pub fn drain_fences(&self) -> Vec<vk::Fence> {
        self.retire_all();
        std::mem::take(&mut self.state.lock().free_fences)
    }
}

static_assertions::assert_impl_all!(SubmissionTracker: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    fn fence(raw: u64) -> vk::Fence {
        vk::Fence::from_raw(raw)
    }

    #[test]
    fn test_submissions_retire_in_order() {
        let tracker = SubmissionTracker::new();
        assert_eq!(tracker.push(fence(1), Vec::new()), 1);
        assert_eq!(tracker.push(fence(2), Vec::new()), 2);
        assert_eq!(tracker.push(fence(3), Vec::new()), 3);

        // The third fence signaling alone retires nothing.
        let completed = tracker.retire(|f| Ok(f == fence(1) || f == fence(3))).unwrap();
        assert_eq!(completed, 1);
        assert_eq!(tracker.in_flight_count(), 2);
        assert_eq!(tracker.fence_of(1), None);
        assert_eq!(tracker.fence_of(2), Some(fence(2)));

        let completed = tracker.retire(|_| Ok(true)).unwrap();
        assert_eq!(completed, 3);
        assert_eq!(tracker.in_flight_count(), 0);
    }

    #[test]
    fn test_in_flight_lists_are_kept_alive() {
        let tracker = SubmissionTracker::new();
        let list = Arc::new(CommandList::new());
        tracker.push(fence(7), vec![list.clone()]);
        assert_eq!(Arc::strong_count(&list), 2);

        tracker.retire(|_| Ok(false)).unwrap();
        assert_eq!(Arc::strong_count(&list), 2);

        assert_eq!(tracker.retire_all(), 1);
        assert_eq!(Arc::strong_count(&list), 1);
    }

    #[test]
    fn test_retired_fences_are_reused() {
        let tracker = SubmissionTracker::new();
        assert_eq!(tracker.take_fence(), None);
        tracker.push(fence(4), Vec::new());
        tracker.retire(|_| Ok(true)).unwrap();
        assert_eq!(tracker.take_fence(), Some(fence(4)));
        assert_eq!(tracker.take_fence(), None);

        tracker.recycle_fence(fence(5));
        assert_eq!(tracker.drain_fences(), vec![fence(5)]);
    }

    #[test]
    fn test_fence_error_stops_retiring() {
        let tracker = SubmissionTracker::new();
        tracker.push(fence(1), Vec::new());
        let result = tracker.retire(|_| Err(vk::Result::ERROR_DEVICE_LOST));
        assert_eq!(result, Err(vk::Result::ERROR_DEVICE_LOST));
        assert_eq!(tracker.completed(), 0);
        assert_eq!(tracker.in_flight_count(), 1);
    }
}
