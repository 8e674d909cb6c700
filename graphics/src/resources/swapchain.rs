//! Swap chains.
//!
//! A swap chain owns the images presented to a surface. On GL there is a
//! single offscreen colour image, blitted to the default framebuffer by
//! [`Queue::present`](crate::Queue::present) before the buffers are swapped.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use crate::backend::GpuSwapChain;
use crate::device::DeviceId;
use crate::error::{GraphicsError, GraphicsResult};
use crate::resources::{Fence, Image, Semaphore};
use crate::types::{Extent2d, Format, ImageUsageFlags};

/// Requested swap chain configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SwapChainDescriptor {
    pub extent: Extent2d,
    pub format: Format,
    /// Preferred number of images; backends may create a different count.
    pub image_count: u32,
    pub usage: ImageUsageFlags,
}

impl SwapChainDescriptor {
    /// A double-buffered colour swap chain.
    pub fn new(width: u32, height: u32, format: Format) -> Self {
        Self {
            extent: Extent2d { width, height },
            format,
            image_count: 2,
            usage: ImageUsageFlags::COLOR_ATTACHMENT | ImageUsageFlags::TRANSFER_DST,
        }
    }

    /// Set the preferred image count.
    pub fn with_image_count(mut self, count: u32) -> Self {
        self.image_count = count;
        self
    }
}

/// Presentable images of a surface.
pub struct SwapChain {
    device: DeviceId,
    descriptor: SwapChainDescriptor,
    images: Vec<Arc<Image>>,
    pub(crate) gpu: GpuSwapChain,
}

impl SwapChain {
    pub(crate) fn new(
        device: DeviceId,
        descriptor: SwapChainDescriptor,
        images: Vec<Arc<Image>>,
        gpu: GpuSwapChain,
    ) -> Self {
        Self {
            device,
            descriptor,
            images,
            gpu,
        }
    }

    /// The device that created this swap chain.
    pub fn device_id(&self) -> DeviceId {
        self.device
    }

    /// Effective configuration (the actual extent, format and image count).
    pub fn descriptor(&self) -> &SwapChainDescriptor {
        &self.descriptor
    }

    /// Size of the images.
    pub fn extent(&self) -> Extent2d {
        self.descriptor.extent
    }

    /// Format of the images.
    pub fn format(&self) -> Format {
        self.descriptor.format
    }

    /// The presentable images.
    pub fn images(&self) -> &[Arc<Image>] {
        &self.images
    }

    /// Image `index`.
    ///
    /// # Panics
    ///
    /// Panics if there is no such image.
    pub fn image(&self, index: u32) -> &Arc<Image> {
        self.images
            .get(index as usize)
            .unwrap_or_else(|| panic!("swap chain has no image {index}"))
    }

    /// Acquires the next image to render into.
    ///
    /// `semaphore` and `fence` are signaled once the image is ready.
    ///
    /// # Errors
    ///
    /// [`GraphicsError::OutOfDate`] when the surface changed and the swap
    /// chain must be recreated, [`GraphicsError::Timeout`] when no image
    /// became available in time.
    pub fn acquire_next_image(
        &self,
        timeout: Duration,
        semaphore: Option<&Semaphore>,
        fence: Option<&Fence>,
    ) -> GraphicsResult<u32> {
        if let Some(semaphore) = semaphore {
            assert_eq!(semaphore.device_id(), self.device, "semaphore belongs to another device");
        }
        if let Some(fence) = fence {
            assert_eq!(fence.device_id(), self.device, "fence belongs to another device");
        }

        match &self.gpu {
            GpuSwapChain::Emulated { next } => {
                let index = next.fetch_add(1, Ordering::Relaxed) % self.images.len() as u32;
                if let Some(semaphore) = semaphore {
                    semaphore.signal_emulated();
                }
                if let Some(fence) = fence {
                    fence.signal_emulated();
                }
                log::trace!("SwapChain: acquired image {index}");
                Ok(index)
            }
            #[cfg(feature = "vulkan-backend")]
            GpuSwapChain::Vulkan { loader, swapchain } => {
                use ash::vk;

                let nanos = u64::try_from(timeout.as_nanos()).unwrap_or(u64::MAX);
                let semaphore = semaphore.map_or(vk::Semaphore::null(), |s| s.gpu.vk_handle());
                let fence = match fence.map(|f| &f.gpu) {
                    Some(crate::backend::GpuFence::Vulkan { fence, .. }) => *fence,
                    _ => vk::Fence::null(),
                };
                match unsafe { loader.acquire_next_image(*swapchain, nanos, semaphore, fence) } {
                    Ok((index, suboptimal)) => {
                        if suboptimal {
                            log::trace!("SwapChain: suboptimal");
                        }
                        Ok(index)
                    }
                    Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Err(GraphicsError::OutOfDate),
                    Err(vk::Result::TIMEOUT | vk::Result::NOT_READY) => {
                        Err(GraphicsError::Timeout)
                    }
                    Err(vk::Result::ERROR_DEVICE_LOST) => Err(GraphicsError::DeviceLost),
                    Err(e) => Err(GraphicsError::NativeCallFailed {
                        call: "vkAcquireNextImageKHR",
                        code: e.as_raw() as i64,
                    }),
                }
            }
        }
    }
}

impl std::fmt::Debug for SwapChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwapChain")
            .field("descriptor", &self.descriptor)
            .field("images", &self.images.len())
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(SwapChain: Send, Sync);

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicU32};

    use super::*;
    use crate::backend::{GpuImage, GpuSemaphore};
    use crate::types::ImageDescriptor;

    fn emulated(count: u32) -> SwapChain {
        let descriptor = SwapChainDescriptor::new(8, 8, Format::Bgra8Unorm).with_image_count(count);
        let images = (0..count)
            .map(|_| {
                Arc::new(Image::new(
                    DeviceId::for_tests(),
                    ImageDescriptor::new_2d(8, 8, descriptor.format, descriptor.usage),
                    GpuImage::Test,
                ))
            })
            .collect();
        SwapChain::new(
            DeviceId::for_tests(),
            descriptor,
            images,
            GpuSwapChain::Emulated {
                next: AtomicU32::new(0),
            },
        )
    }

    #[test]
    fn test_acquire_cycles_images() {
        let chain = emulated(2);
        let indices: Vec<u32> = (0..3)
            .map(|_| chain.acquire_next_image(Duration::ZERO, None, None).unwrap())
            .collect();
        assert_eq!(indices, vec![0, 1, 0]);
    }

    #[test]
    fn test_acquire_signals_semaphore() {
        let chain = emulated(1);
        let semaphore = Semaphore::new(
            DeviceId::for_tests(),
            GpuSemaphore::Emulated {
                signaled: AtomicBool::new(false),
            },
        );
        chain
            .acquire_next_image(Duration::ZERO, Some(&semaphore), None)
            .unwrap();
        assert!(semaphore.consume_emulated());
    }
}
