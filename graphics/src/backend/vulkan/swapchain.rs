//! Native swapchain creation for a surface.

use ash::vk;

use super::conversion::{convert_format, convert_image_usage, format_from_vk};
use super::instance::VulkanInstance;
use crate::error::{GraphicsError, GraphicsResult};
use crate::resources::SwapChainDescriptor;
use crate::types::Extent2d;

/// Queue families the swapchain images are used from.
#[derive(Debug, Clone, Copy)]
pub struct SwapchainQueues {
    pub graphics_family: u32,
    pub present_family: u32,
}

/// Creates a swapchain as close to `descriptor` as the surface allows.
///
/// Returns the swapchain, the configuration actually created and its
/// images.
pub fn create_swapchain(
    instance: &VulkanInstance,
    physical_device: vk::PhysicalDevice,
    loader: &ash::khr::swapchain::Device,
    surface: vk::SurfaceKHR,
    queues: SwapchainQueues,
    descriptor: &SwapChainDescriptor,
) -> GraphicsResult<(vk::SwapchainKHR, SwapChainDescriptor, Vec<vk::Image>)> {
    let surface_loader = instance.surface_loader();
    let query_failed = |call: &'static str| {
        move |e: vk::Result| GraphicsError::NativeCallFailed {
            call,
            code: e.as_raw() as i64,
        }
    };
    let capabilities = unsafe {
        surface_loader.get_physical_device_surface_capabilities(physical_device, surface)
    }
    .map_err(query_failed("vkGetPhysicalDeviceSurfaceCapabilitiesKHR"))?;
    let formats =
        unsafe { surface_loader.get_physical_device_surface_formats(physical_device, surface) }
            .map_err(query_failed("vkGetPhysicalDeviceSurfaceFormatsKHR"))?;

    let surface_format = choose_surface_format(&formats, descriptor)?;
    let Some(format) = format_from_vk(surface_format.format) else {
        return Err(GraphicsError::FeatureNotSupported(format!(
            "surface format {:?}",
            surface_format.format
        )));
    };
    let extent = choose_extent(&capabilities, descriptor.extent);
    let image_count = choose_image_count(&capabilities, descriptor.image_count);

    let families = [queues.graphics_family, queues.present_family];
    let (sharing_mode, family_indices): (_, &[u32]) =
        if queues.graphics_family == queues.present_family {
            (vk::SharingMode::EXCLUSIVE, &[])
        } else {
            (vk::SharingMode::CONCURRENT, &families)
        };

    let create_info = vk::SwapchainCreateInfoKHR::default()
        .surface(surface)
        .min_image_count(image_count)
        .image_format(surface_format.format)
        .image_color_space(surface_format.color_space)
        .image_extent(vk::Extent2D {
            width: extent.width,
            height: extent.height,
        })
        .image_array_layers(1)
        .image_usage(convert_image_usage(descriptor.usage))
        .image_sharing_mode(sharing_mode)
        .queue_family_indices(family_indices)
        .pre_transform(capabilities.current_transform)
        .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
        .present_mode(vk::PresentModeKHR::FIFO)
        .clipped(true)
        .old_swapchain(vk::SwapchainKHR::null());

    let swapchain = unsafe { loader.create_swapchain(&create_info, None) }.map_err(|e| {
        GraphicsError::ResourceCreationFailed(format!("failed to create swapchain: {e:?}"))
    })?;
    let images = match unsafe { loader.get_swapchain_images(swapchain) } {
        Ok(images) => images,
        Err(e) => {
            unsafe { loader.destroy_swapchain(swapchain, None) };
            return Err(GraphicsError::ResourceCreationFailed(format!(
                "failed to get swapchain images: {e:?}"
            )));
        }
    };

    let actual = SwapChainDescriptor {
        extent,
        format,
        image_count: images.len() as u32,
        usage: descriptor.usage,
    };
    log::debug!(
        "Vulkan: swapchain {}x{} {:?}, {} images",
        extent.width,
        extent.height,
        format,
        images.len()
    );
    Ok((swapchain, actual, images))
}

/// The requested format if the surface supports it, otherwise the first
/// supported format.
fn choose_surface_format(
    formats: &[vk::SurfaceFormatKHR],
    descriptor: &SwapChainDescriptor,
) -> GraphicsResult<vk::SurfaceFormatKHR> {
    let requested = convert_format(descriptor.format);
    formats
        .iter()
        .find(|f| f.format == requested)
        .or_else(|| formats.iter().find(|f| format_from_vk(f.format).is_some()))
        .copied()
        .ok_or_else(|| {
            GraphicsError::FeatureNotSupported("surface has no usable format".to_string())
        })
}

fn choose_extent(capabilities: &vk::SurfaceCapabilitiesKHR, requested: Extent2d) -> Extent2d {
    if capabilities.current_extent.width != u32::MAX {
        return Extent2d::new(
            capabilities.current_extent.width,
            capabilities.current_extent.height,
        );
    }
    Extent2d::new(
        requested.width.clamp(
            capabilities.min_image_extent.width,
            capabilities.max_image_extent.width,
        ),
        requested.height.clamp(
            capabilities.min_image_extent.height,
            capabilities.max_image_extent.height,
        ),
    )
}

fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR, requested: u32) -> u32 {
    // A maximum of zero means unbounded.
    let max = if capabilities.max_image_count > 0 {
        capabilities.max_image_count
    } else {
        u32::MAX
    };
    requested.clamp(capabilities.min_image_count, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Format;

    fn capabilities(current: vk::Extent2D) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 3,
            current_extent: current,
            min_image_extent: vk::Extent2D {
                width: 1,
                height: 1,
            },
            max_image_extent: vk::Extent2D {
                width: 1024,
                height: 768,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_extent_follows_surface() {
        let caps = capabilities(vk::Extent2D {
            width: 640,
            height: 480,
        });
        assert_eq!(choose_extent(&caps, Extent2d::new(800, 600)), Extent2d::new(640, 480));
    }

    #[test]
    fn test_extent_clamped_when_surface_is_flexible() {
        let caps = capabilities(vk::Extent2D {
            width: u32::MAX,
            height: u32::MAX,
        });
        assert_eq!(
            choose_extent(&caps, Extent2d::new(4096, 600)),
            Extent2d::new(1024, 600)
        );
    }

    #[test]
    fn test_image_count_clamped() {
        let caps = capabilities(vk::Extent2D::default());
        assert_eq!(choose_image_count(&caps, 1), 2);
        assert_eq!(choose_image_count(&caps, 8), 3);

        let unbounded = vk::SurfaceCapabilitiesKHR {
            max_image_count: 0,
            ..caps
        };
        assert_eq!(choose_image_count(&unbounded, 8), 8);
    }

    #[test]
    fn test_surface_format_fallback() {
        let formats = [
            vk::SurfaceFormatKHR {
                format: vk::Format::R5G6B5_UNORM_PACK16,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
            vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_UNORM,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
        ];
        let descriptor = SwapChainDescriptor::new(8, 8, Format::Rgba8Srgb);
        let chosen = choose_surface_format(&formats, &descriptor).unwrap();
        assert_eq!(chosen.format, vk::Format::B8G8R8A8_UNORM);

        assert!(choose_surface_format(&formats[..1], &descriptor).is_err());
    }
}
