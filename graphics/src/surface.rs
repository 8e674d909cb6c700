//! Window surfaces for the Vulkan backend.
//!
//! A [`Surface`] is created by
//! [`GraphicsInstance::create_surface`](crate::GraphicsInstance::create_surface)
//! and handed to a device through [`Connection::vulkan`](crate::Connection::vulkan).
//! Swap chains of that device present to it.

use std::sync::Arc;

use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::backend::vulkan::VulkanInstance;
use crate::error::{GraphicsError, GraphicsResult};

/// A presentable window surface.
///
/// The window must outlive the surface.
pub struct Surface {
    instance: Arc<VulkanInstance>,
    surface: vk::SurfaceKHR,
}

impl Surface {
    pub(crate) fn new<W>(instance: Arc<VulkanInstance>, window: &W) -> GraphicsResult<Self>
    where
        W: HasWindowHandle + HasDisplayHandle,
    {
        let display_handle = window.display_handle().map_err(|e| {
            GraphicsError::ResourceCreationFailed(format!("failed to get display handle: {e}"))
        })?;
        let window_handle = window.window_handle().map_err(|e| {
            GraphicsError::ResourceCreationFailed(format!("failed to get window handle: {e}"))
        })?;

        let surface = unsafe {
            ash_window::create_surface(
                instance.entry(),
                instance.instance(),
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
        }
        .map_err(|e| {
            GraphicsError::ResourceCreationFailed(format!("failed to create Vulkan surface: {e}"))
        })?;

        log::info!("Surface: created {surface:?}");
        Ok(Self { instance, surface })
    }

    pub(crate) fn vk_handle(&self) -> vk::SurfaceKHR {
        self.surface
    }

    pub(crate) fn vulkan_instance(&self) -> &Arc<VulkanInstance> {
        &self.instance
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        unsafe {
            self.instance
                .surface_loader()
                .destroy_surface(self.surface, None)
        };
        log::trace!("Surface: destroyed");
    }
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("surface", &self.surface)
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(Surface: Send, Sync);
