//! Vulkan instance creation and ownership.

use std::ffi::{CStr, CString};

use ash::vk;

use super::debug;
use crate::error::{GraphicsError, GraphicsResult};

/// Render passes and `vkCmd*` calls only need Vulkan 1.1 semantics; 1.2
/// keeps MoltenVK usable.
const API_VERSION: u32 = vk::make_api_version(0, 1, 2, 0);

const VALIDATION_LAYER_NAME: &CStr = c"VK_LAYER_KHRONOS_validation";

const ENGINE_NAME: &CStr = c"ashes";

/// An `ash` instance with its optional debug messenger.
///
/// Devices and surfaces keep the instance alive through an `Arc`; it is
/// destroyed after the last of them.
pub struct VulkanInstance {
    entry: ash::Entry,
    instance: ash::Instance,
    surface_loader: ash::khr::surface::Instance,
    debug_utils: Option<ash::ext::debug_utils::Instance>,
    messenger: Option<vk::DebugUtilsMessengerEXT>,
    validation: bool,
}

impl VulkanInstance {
    /// Loads the Vulkan library and creates an instance.
    ///
    /// Validation is enabled only when the Khronos layer is installed;
    /// otherwise a warning is logged and the instance is created without it.
    pub fn new(application_name: &str, validation: bool) -> GraphicsResult<Self> {
        let entry = unsafe { ash::Entry::load() }.map_err(|e| {
            GraphicsError::InitializationFailed(format!("failed to load Vulkan: {e}"))
        })?;

        let validation_available = validation && has_validation_layer(&entry);
        if validation && !validation_available {
            log::warn!("Vulkan: validation requested but {VALIDATION_LAYER_NAME:?} is missing");
        }

        let app_name = CString::new(application_name).map_err(|_| {
            GraphicsError::InvalidParameter(format!(
                "application name {application_name:?} contains a NUL byte"
            ))
        })?;
        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name)
            .application_version(vk::make_api_version(0, 0, 1, 0))
            .engine_name(ENGINE_NAME)
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(API_VERSION);

        let mut extensions = vec![ash::khr::surface::NAME.as_ptr()];
        #[cfg(target_os = "windows")]
        extensions.push(ash::khr::win32_surface::NAME.as_ptr());
        #[cfg(all(unix, not(target_os = "macos"), not(target_os = "android")))]
        {
            extensions.push(ash::khr::xlib_surface::NAME.as_ptr());
            extensions.push(ash::khr::wayland_surface::NAME.as_ptr());
        }
        #[cfg(target_os = "macos")]
        {
            extensions.push(ash::khr::portability_enumeration::NAME.as_ptr());
            extensions.push(ash::ext::metal_surface::NAME.as_ptr());
        }
        if validation_available {
            extensions.push(ash::ext::debug_utils::NAME.as_ptr());
        }

        let layers = if validation_available {
            vec![VALIDATION_LAYER_NAME.as_ptr()]
        } else {
            Vec::new()
        };

        #[allow(unused_mut)]
        let mut flags = vk::InstanceCreateFlags::empty();
        #[cfg(target_os = "macos")]
        {
            flags |= vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR;
        }

        let create_info = vk::InstanceCreateInfo::default()
            .flags(flags)
            .application_info(&app_info)
            .enabled_extension_names(&extensions)
            .enabled_layer_names(&layers);
        let instance = unsafe { entry.create_instance(&create_info, None) }.map_err(|e| {
            GraphicsError::InitializationFailed(format!("vkCreateInstance failed: {e:?}"))
        })?;

        let (debug_utils, messenger) = if validation_available {
            let debug_utils = ash::ext::debug_utils::Instance::new(&entry, &instance);
            match debug::create_debug_messenger(&debug_utils) {
                Ok(messenger) => (Some(debug_utils), Some(messenger)),
                Err(e) => {
                    unsafe { instance.destroy_instance(None) };
                    return Err(e);
                }
            }
        } else {
            (None, None)
        };

        let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);
        log::info!(
            "Vulkan: instance created for {application_name:?} (validation: {validation_available})"
        );
        Ok(Self {
            entry,
            instance,
            surface_loader,
            debug_utils,
            messenger,
            validation: validation_available,
        })
    }

    pub fn entry(&self) -> &ash::Entry {
        &self.entry
    }

    pub fn instance(&self) -> &ash::Instance {
        &self.instance
    }

    pub fn surface_loader(&self) -> &ash::khr::surface::Instance {
        &self.surface_loader
    }

    /// Whether the validation layer is active.
    pub fn validation(&self) -> bool {
        self.validation
    }
}

impl Drop for VulkanInstance {
    fn drop(&mut self) {
        unsafe {
            if let (Some(debug_utils), Some(messenger)) = (&self.debug_utils, self.messenger) {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
        log::info!("Vulkan: instance destroyed");
    }
}

impl std::fmt::Debug for VulkanInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanInstance")
            .field("instance", &self.instance.handle())
            .field("validation", &self.validation)
            .finish_non_exhaustive()
    }
}

fn has_validation_layer(entry: &ash::Entry) -> bool {
    let Ok(layers) = (unsafe { entry.enumerate_instance_layer_properties() }) else {
        return false;
    };
    layers
        .iter()
        .any(|layer| layer.layer_name_as_c_str().is_ok_and(|name| name == VALIDATION_LAYER_NAME))
}
