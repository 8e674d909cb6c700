//! Semaphores and fences.

use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::backend::{gl, GpuFence, GpuSemaphore};
use crate::device::DeviceId;
use crate::error::{GraphicsError, GraphicsResult};
use crate::types::WaitResult;

/// Orders work between queue submissions and presentation.
///
/// GL and Test execute submissions in order on one thread, so their
/// semaphores only remember whether they were signaled.
pub struct Semaphore {
    device: DeviceId,
    pub(crate) gpu: GpuSemaphore,
}

impl Semaphore {
    pub(crate) fn new(device: DeviceId, gpu: GpuSemaphore) -> Self {
        Self { device, gpu }
    }

    /// The device that created this semaphore.
    pub fn device_id(&self) -> DeviceId {
        self.device
    }

    pub(crate) fn signal_emulated(&self) {
        if let GpuSemaphore::Emulated { signaled } = &self.gpu {
            signaled.store(true, Ordering::Release);
        }
    }

    /// Consumes a signal; false if none was pending.
    pub(crate) fn consume_emulated(&self) -> bool {
        match &self.gpu {
            GpuSemaphore::Emulated { signaled } => signaled.swap(false, Ordering::AcqRel),
            #[cfg(feature = "vulkan-backend")]
            GpuSemaphore::Vulkan { .. } => true,
        }
    }
}

impl std::fmt::Debug for Semaphore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Semaphore").field("gpu", &self.gpu).finish()
    }
}

static_assertions::assert_impl_all!(Semaphore: Send, Sync);

/// Signals the host when a submission completes.
///
/// On GL the fence holds the sync object inserted after the submission's
/// last command.
pub struct Fence {
    device: DeviceId,
    pub(crate) gpu: GpuFence,
}

impl Fence {
    pub(crate) fn new(device: DeviceId, gpu: GpuFence) -> Self {
        Self { device, gpu }
    }

    /// The device that created this fence.
    pub fn device_id(&self) -> DeviceId {
        self.device
    }

    /// Blocks until the fence is signaled or `timeout` elapses.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::DeviceLost`] if the device was lost while
    /// waiting.
    pub fn wait(&self, timeout: Duration) -> GraphicsResult<WaitResult> {
        match &self.gpu {
            GpuFence::Test { signaled } => Ok(if signaled.load(Ordering::Acquire) {
                WaitResult::Success
            } else {
                WaitResult::TimeOut
            }),
            GpuFence::Gl {
                context,
                sync,
                signaled,
            } => gl::wait_sync(context, sync, signaled, timeout),
            #[cfg(feature = "vulkan-backend")]
            GpuFence::Vulkan { device, fence } => {
                let nanos = u64::try_from(timeout.as_nanos()).unwrap_or(u64::MAX);
                match unsafe { device.wait_for_fences(&[*fence], true, nanos) } {
                    Ok(()) => Ok(WaitResult::Success),
                    Err(ash::vk::Result::TIMEOUT) => Ok(WaitResult::TimeOut),
                    Err(ash::vk::Result::ERROR_DEVICE_LOST) => Err(GraphicsError::DeviceLost),
                    Err(e) => Err(GraphicsError::NativeCallFailed {
                        call: "vkWaitForFences",
                        code: e.as_raw() as i64,
                    }),
                }
            }
        }
    }

    /// Whether the fence is signaled, without blocking.
    pub fn status(&self) -> GraphicsResult<bool> {
        match &self.gpu {
            #[cfg(feature = "vulkan-backend")]
            GpuFence::Vulkan { device, fence } => unsafe { device.get_fence_status(*fence) }
                .map_err(|e| match e {
                    ash::vk::Result::ERROR_DEVICE_LOST => GraphicsError::DeviceLost,
                    e => GraphicsError::NativeCallFailed {
                        call: "vkGetFenceStatus",
                        code: e.as_raw() as i64,
                    },
                }),
            _ => self
                .wait(Duration::ZERO)
                .map(|result| result == WaitResult::Success),
        }
    }

    /// Returns the fence to the unsignaled state.
    pub fn reset(&self) -> GraphicsResult<()> {
        match &self.gpu {
            GpuFence::Test { signaled } => signaled.store(false, Ordering::Release),
            GpuFence::Gl {
                context,
                sync,
                signaled,
            } => gl::reset_sync(context, sync, signaled)?,
            #[cfg(feature = "vulkan-backend")]
            GpuFence::Vulkan { device, fence } => unsafe { device.reset_fences(&[*fence]) }
                .map_err(|e| GraphicsError::NativeCallFailed {
                    call: "vkResetFences",
                    code: e.as_raw() as i64,
                })?,
        }
        Ok(())
    }

    /// Marks the fence signaled from the host, without a GL sync object.
    pub(crate) fn signal_emulated(&self) {
        match &self.gpu {
            GpuFence::Test { signaled } | GpuFence::Gl { signaled, .. } => {
                signaled.store(true, Ordering::Release)
            }
            #[cfg(feature = "vulkan-backend")]
            GpuFence::Vulkan { .. } => {}
        }
    }
}

impl std::fmt::Debug for Fence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fence").field("gpu", &self.gpu).finish()
    }
}

static_assertions::assert_impl_all!(Fence: Send, Sync);

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;

    use super::*;

    fn test_fence(signaled: bool) -> Fence {
        Fence::new(
            DeviceId::for_tests(),
            GpuFence::Test {
                signaled: AtomicBool::new(signaled),
            },
        )
    }

    #[test]
    fn test_fence_signal_and_reset() {
        let fence = test_fence(false);
        assert_eq!(fence.wait(Duration::ZERO).unwrap(), WaitResult::TimeOut);
        fence.signal_emulated();
        assert!(fence.status().unwrap());
        fence.reset().unwrap();
        assert!(!fence.status().unwrap());
    }

    #[test]
    fn test_semaphore_signal_is_consumed_once() {
        let semaphore = Semaphore::new(
            DeviceId::for_tests(),
            GpuSemaphore::Emulated {
                signaled: AtomicBool::new(false),
            },
        );
        assert!(!semaphore.consume_emulated());
        semaphore.signal_emulated();
        assert!(semaphore.consume_emulated());
        assert!(!semaphore.consume_emulated());
    }
}
