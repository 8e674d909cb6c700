//! Device-creation boundary.
//!
//! A [`Connection`] tells [`GraphicsInstance::create_device`] what to build
//! the device on: nothing (Test backend), a GL platform context with its
//! entry points, or a Vulkan physical device and surface.
//!
//! [`GraphicsInstance::create_device`]: crate::GraphicsInstance::create_device

use std::sync::Arc;

#[cfg(feature = "vulkan-backend")]
use ash::vk;

use crate::backend::gl::{GlApi, PlatformContext};
#[cfg(feature = "vulkan-backend")]
use crate::surface::Surface;

/// Native objects a device is created on.
#[derive(Clone)]
pub enum Platform {
    /// No native objects; for the Test backend.
    Headless,
    /// A GL context and the entry points that drive it.
    Gl {
        context: Arc<dyn PlatformContext>,
        api: Arc<dyn GlApi>,
    },
    /// A Vulkan device, chosen automatically when `physical_device` is unset.
    #[cfg(feature = "vulkan-backend")]
    Vulkan {
        physical_device: Option<vk::PhysicalDevice>,
        surface: Option<Arc<Surface>>,
    },
}

impl Platform {
    /// Short name used in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Headless => "headless",
            Self::Gl { .. } => "GL",
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan { .. } => "Vulkan",
        }
    }
}

impl std::fmt::Debug for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Headless => write!(f, "Platform::Headless"),
            Self::Gl { .. } => f.debug_struct("Platform::Gl").finish_non_exhaustive(),
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan {
                physical_device,
                surface,
            } => f
                .debug_struct("Platform::Vulkan")
                .field("physical_device", physical_device)
                .field("surface", surface)
                .finish(),
        }
    }
}

/// Everything a device is created from.
///
/// # Example
///
/// ```ignore
/// let connection = Connection::gl(Arc::new(HeadlessPlatform::new()), Arc::new(RecordingGl::new()))
///     .with_extension("GL_KHR_debug");
/// let device = instance.create_device(connection)?;
/// ```
#[derive(Debug, Clone)]
pub struct Connection {
    /// Queue family for graphics work; the backend picks one when unset.
    pub graphics_family: Option<u32>,
    /// Queue family for presentation; the backend picks one when unset.
    pub present_family: Option<u32>,
    /// Device extensions to enable.
    pub extensions: Vec<String>,
    /// Layers requested for the device.
    pub layers: Vec<String>,
    pub platform: Platform,
}

impl Connection {
    fn new(platform: Platform) -> Self {
        Self {
            graphics_family: None,
            present_family: None,
            extensions: Vec::new(),
            layers: Vec::new(),
            platform,
        }
    }

    /// A connection without native objects, for the Test backend.
    pub fn headless() -> Self {
        Self::new(Platform::Headless)
    }

    /// A connection to a GL context.
    pub fn gl(context: Arc<dyn PlatformContext>, api: Arc<dyn GlApi>) -> Self {
        Self::new(Platform::Gl { context, api })
    }

    /// A Vulkan connection, optionally presenting to `surface`.
    #[cfg(feature = "vulkan-backend")]
    pub fn vulkan(surface: Option<Arc<Surface>>) -> Self {
        Self::new(Platform::Vulkan {
            physical_device: None,
            surface,
        })
    }

    /// Use a specific physical device instead of the best available one.
    ///
    /// Has no effect on non-Vulkan connections.
    #[cfg(feature = "vulkan-backend")]
    pub fn with_physical_device(mut self, device: vk::PhysicalDevice) -> Self {
        if let Platform::Vulkan {
            physical_device, ..
        } = &mut self.platform
        {
            *physical_device = Some(device);
        }
        self
    }

    pub fn with_queue_families(mut self, graphics: u32, present: u32) -> Self {
        self.graphics_family = Some(graphics);
        self.present_family = Some(present);
        self
    }

    pub fn with_extension(mut self, name: impl Into<String>) -> Self {
        self.extensions.push(name.into());
        self
    }

    pub fn with_layer(mut self, name: impl Into<String>) -> Self {
        self.layers.push(name.into());
        self
    }

    /// Whether `name` was requested as an extension.
    pub fn has_extension(&self, name: &str) -> bool {
        self.extensions.iter().any(|e| e == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::gl::{HeadlessPlatform, RecordingGl};

    #[test]
    fn test_headless_defaults() {
        let connection = Connection::headless();
        assert!(matches!(connection.platform, Platform::Headless));
        assert_eq!(connection.graphics_family, None);
        assert!(connection.extensions.is_empty());
        assert_eq!(connection.platform.name(), "headless");
    }

    #[test]
    fn test_builder() {
        let connection = Connection::gl(
            Arc::new(HeadlessPlatform::new()),
            Arc::new(RecordingGl::new()),
        )
        .with_queue_families(0, 1)
        .with_extension("GL_KHR_debug")
        .with_layer("VK_LAYER_KHRONOS_validation");

        assert_eq!(connection.platform.name(), "GL");
        assert_eq!(connection.graphics_family, Some(0));
        assert_eq!(connection.present_family, Some(1));
        assert!(connection.has_extension("GL_KHR_debug"));
        assert!(!connection.has_extension("GL_ARB_compute_shader"));
        assert_eq!(connection.layers, ["VK_LAYER_KHRONOS_validation"]);
    }
}
