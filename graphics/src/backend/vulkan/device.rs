//! Physical device selection and logical device creation.

use std::ffi::{CStr, CString};

use ash::vk;

use crate::backend::BackendCapabilities;
use crate::error::{GraphicsError, GraphicsResult};

/// Picks the best physical device, preferring discrete GPUs.
pub fn select_physical_device(instance: &ash::Instance) -> GraphicsResult<vk::PhysicalDevice> {
    let devices = unsafe { instance.enumerate_physical_devices() }.map_err(|e| {
        GraphicsError::InitializationFailed(format!("vkEnumeratePhysicalDevices failed: {e:?}"))
    })?;

    let mut best = None;
    let mut best_score = 0;
    for device in devices {
        let properties = unsafe { instance.get_physical_device_properties(device) };
        let mut score = match properties.device_type {
            vk::PhysicalDeviceType::DISCRETE_GPU => 1000,
            vk::PhysicalDeviceType::INTEGRATED_GPU => 100,
            vk::PhysicalDeviceType::VIRTUAL_GPU => 50,
            _ => 1,
        };
        score += properties.limits.max_image_dimension2_d / 1024;

        let name = properties.device_name_as_c_str().unwrap_or(c"unknown");
        log::info!(
            "Vulkan: found {name:?} ({:?}, score {score})",
            properties.device_type
        );
        if score > best_score {
            best_score = score;
            best = Some(device);
        }
    }

    best.ok_or_else(|| {
        GraphicsError::InitializationFailed("no Vulkan-capable GPU found".to_string())
    })
}

/// Queue families for graphics and presentation.
///
/// Without a surface the graphics family doubles as the present family.
pub fn find_queue_families(
    instance: &ash::Instance,
    surface_loader: &ash::khr::surface::Instance,
    physical_device: vk::PhysicalDevice,
    surface: Option<vk::SurfaceKHR>,
) -> GraphicsResult<(u32, u32)> {
    let families =
        unsafe { instance.get_physical_device_queue_family_properties(physical_device) };
    let graphics = families
        .iter()
        .position(|family| family.queue_flags.contains(vk::QueueFlags::GRAPHICS))
        .ok_or_else(|| {
            GraphicsError::InitializationFailed("no graphics queue family".to_string())
        })? as u32;

    let Some(surface) = surface else {
        return Ok((graphics, graphics));
    };
    let supports_present = |index: u32| unsafe {
        surface_loader
            .get_physical_device_surface_support(physical_device, index, surface)
            .unwrap_or(false)
    };
    if supports_present(graphics) {
        return Ok((graphics, graphics));
    }
    let present = (0..families.len() as u32)
        .find(|&index| supports_present(index))
        .ok_or_else(|| {
            GraphicsError::InitializationFailed("no queue family can present".to_string())
        })?;
    Ok((graphics, present))
}

/// Creates the logical device with one queue per distinct family.
///
/// `extensions` are enabled in addition to `VK_KHR_swapchain`.
pub fn create_logical_device(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    graphics_family: u32,
    present_family: u32,
    extensions: &[String],
) -> GraphicsResult<ash::Device> {
    let priorities = [1.0f32];
    let mut queue_infos = vec![vk::DeviceQueueCreateInfo::default()
        .queue_family_index(graphics_family)
        .queue_priorities(&priorities)];
    if present_family != graphics_family {
        queue_infos.push(
            vk::DeviceQueueCreateInfo::default()
                .queue_family_index(present_family)
                .queue_priorities(&priorities),
        );
    }

    let extra = extensions
        .iter()
        .map(|name| {
            CString::new(name.as_str()).map_err(|_| {
                GraphicsError::InvalidParameter(format!("extension name {name:?} contains NUL"))
            })
        })
        .collect::<GraphicsResult<Vec<_>>>()?;
    let mut extension_names = vec![ash::khr::swapchain::NAME.as_ptr()];
    extension_names.extend(
        extra
            .iter()
            .map(|name| name.as_c_str())
            .filter(|name| *name != ash::khr::swapchain::NAME)
            .map(CStr::as_ptr),
    );

    let supported = unsafe { instance.get_physical_device_features(physical_device) };
    let features = vk::PhysicalDeviceFeatures::default()
        .sampler_anisotropy(supported.sampler_anisotropy == vk::TRUE)
        .tessellation_shader(supported.tessellation_shader == vk::TRUE)
        .multi_draw_indirect(supported.multi_draw_indirect == vk::TRUE)
        .depth_bias_clamp(supported.depth_bias_clamp == vk::TRUE)
        .depth_clamp(supported.depth_clamp == vk::TRUE)
        .fill_mode_non_solid(supported.fill_mode_non_solid == vk::TRUE)
        .wide_lines(supported.wide_lines == vk::TRUE)
        .dual_src_blend(supported.dual_src_blend == vk::TRUE)
        .logic_op(supported.logic_op == vk::TRUE)
        .sample_rate_shading(supported.sample_rate_shading == vk::TRUE)
        .pipeline_statistics_query(supported.pipeline_statistics_query == vk::TRUE)
        .occlusion_query_precise(supported.occlusion_query_precise == vk::TRUE);

    let create_info = vk::DeviceCreateInfo::default()
        .queue_create_infos(&queue_infos)
        .enabled_extension_names(&extension_names)
        .enabled_features(&features);

    unsafe { instance.create_device(physical_device, &create_info, None) }.map_err(|e| {
        GraphicsError::InitializationFailed(format!("vkCreateDevice failed: {e:?}"))
    })
}

/// Capabilities from the physical device limits and features.
pub fn capabilities(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
) -> BackendCapabilities {
    let properties = unsafe { instance.get_physical_device_properties(physical_device) };
    let features = unsafe { instance.get_physical_device_features(physical_device) };
    let limits = properties.limits;
    BackendCapabilities {
        memory_barriers: true,
        indirect_draw: true,
        compute: true,
        base_instance: true,
        depth_bias_clamp: features.depth_bias_clamp == vk::TRUE,
        tex_storage: true,
        tessellation: features.tessellation_shader == vk::TRUE,
        max_image_dimension: limits.max_image_dimension2_d,
        ..BackendCapabilities::full()
    }
}
