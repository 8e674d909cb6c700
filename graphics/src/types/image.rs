//! Image and image view types and descriptors.

use super::{
    Extent3d, Format, ImageAspectFlags, ImageUsageFlags, MemoryPropertyFlags, Offset3d,
};

/// Dimensionality of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageType {
    D1,
    #[default]
    D2,
    D3,
}

/// Dimensionality of an image view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageViewType {
    D1,
    #[default]
    D2,
    D3,
    Cube,
    D1Array,
    D2Array,
    CubeArray,
}

/// Number of samples per texel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SampleCount {
    #[default]
    X1,
    X2,
    X4,
    X8,
    X16,
}

impl SampleCount {
    /// Number of samples as an integer.
    pub fn count(&self) -> u32 {
        match self {
            Self::X1 => 1,
            Self::X2 => 2,
            Self::X4 => 4,
            Self::X8 => 8,
            Self::X16 => 16,
        }
    }
}

/// Layout of image memory. GL ignores layouts; Vulkan uses them for barriers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageLayout {
    #[default]
    Undefined,
    General,
    ColourAttachmentOptimal,
    DepthStencilAttachmentOptimal,
    DepthStencilReadOnlyOptimal,
    ShaderReadOnlyOptimal,
    TransferSrcOptimal,
    TransferDstOptimal,
    Preinitialized,
    PresentSrc,
}

/// Swizzle of one component of an image view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ComponentSwizzle {
    #[default]
    Identity,
    Zero,
    One,
    R,
    G,
    B,
    A,
}

/// Component remapping of an image view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ComponentMapping {
    pub r: ComponentSwizzle,
    pub g: ComponentSwizzle,
    pub b: ComponentSwizzle,
    pub a: ComponentSwizzle,
}

/// A range of mip levels and array layers of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageSubresourceRange {
    pub aspect_mask: ImageAspectFlags,
    pub base_mip_level: u32,
    pub level_count: u32,
    pub base_array_layer: u32,
    pub layer_count: u32,
}

impl ImageSubresourceRange {
    /// The first mip level and array layer of the given aspects.
    pub fn single(aspect_mask: ImageAspectFlags) -> Self {
        Self {
            aspect_mask,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        }
    }
}

impl Default for ImageSubresourceRange {
    fn default() -> Self {
        Self::single(ImageAspectFlags::COLOR)
    }
}

/// A single mip level and a range of array layers of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageSubresourceLayers {
    pub aspect_mask: ImageAspectFlags,
    pub mip_level: u32,
    pub base_array_layer: u32,
    pub layer_count: u32,
}

impl Default for ImageSubresourceLayers {
    fn default() -> Self {
        Self {
            aspect_mask: ImageAspectFlags::COLOR,
            mip_level: 0,
            base_array_layer: 0,
            layer_count: 1,
        }
    }
}

/// One region of an image-to-image copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ImageCopy {
    pub src_subresource: ImageSubresourceLayers,
    pub src_offset: Offset3d,
    pub dst_subresource: ImageSubresourceLayers,
    pub dst_offset: Offset3d,
    pub extent: Extent3d,
}

/// One region of a buffer-to-image copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BufferImageCopy {
    pub buffer_offset: u64,
    /// Row length in texels, zero meaning tightly packed.
    pub buffer_row_length: u32,
    /// Image height in texels, zero meaning tightly packed.
    pub buffer_image_height: u32,
    pub image_subresource: ImageSubresourceLayers,
    pub image_offset: Offset3d,
    pub image_extent: Extent3d,
}

/// Descriptor for creating an image.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageDescriptor {
    /// Debug label for the image.
    pub label: Option<String>,
    pub image_type: ImageType,
    pub format: Format,
    pub extent: Extent3d,
    pub mip_levels: u32,
    pub array_layers: u32,
    pub samples: SampleCount,
    pub usage: ImageUsageFlags,
    pub memory_flags: MemoryPropertyFlags,
}

impl ImageDescriptor {
    /// Create a new 2D image descriptor.
    pub fn new_2d(width: u32, height: u32, format: Format, usage: ImageUsageFlags) -> Self {
        Self {
            label: None,
            image_type: ImageType::D2,
            format,
            extent: Extent3d::new_2d(width, height),
            mip_levels: 1,
            array_layers: 1,
            samples: SampleCount::X1,
            usage,
            memory_flags: MemoryPropertyFlags::DEVICE_LOCAL,
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the mip level count.
    pub fn with_mip_levels(mut self, count: u32) -> Self {
        self.mip_levels = count;
        self
    }

    /// Set the array layer count.
    pub fn with_array_layers(mut self, count: u32) -> Self {
        self.array_layers = count;
        self
    }

    /// Set the sample count for multisampling.
    pub fn with_samples(mut self, samples: SampleCount) -> Self {
        self.samples = samples;
        self
    }
}

impl Default for ImageDescriptor {
    fn default() -> Self {
        Self::new_2d(1, 1, Format::default(), ImageUsageFlags::empty())
    }
}

/// Descriptor for creating a view on an image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ImageViewDescriptor {
    pub label: Option<String>,
    pub view_type: ImageViewType,
    /// View format; `None` reuses the image format.
    pub format: Option<Format>,
    pub components: ComponentMapping,
    /// Subresources seen through the view; `None` covers the whole image.
    pub subresource_range: Option<ImageSubresourceRange>,
}

impl ImageViewDescriptor {
    /// A 2D view of the whole image.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the view type.
    pub fn with_view_type(mut self, view_type: ImageViewType) -> Self {
        self.view_type = view_type;
        self
    }

    /// Restrict the view to a subresource range.
    pub fn with_subresource_range(mut self, range: ImageSubresourceRange) -> Self {
        self.subresource_range = Some(range);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_descriptor_defaults() {
        let desc = ImageDescriptor::new_2d(
            64,
            32,
            Format::Rgba8Unorm,
            ImageUsageFlags::COLOR_ATTACHMENT,
        )
        .with_mip_levels(3)
        .with_label("albedo");
        assert_eq!(desc.extent, Extent3d::new(64, 32, 1));
        assert_eq!(desc.mip_levels, 3);
        assert_eq!(desc.array_layers, 1);
        assert_eq!(desc.samples.count(), 1);
    }

    #[test]
    fn test_view_descriptor_covers_whole_image_by_default() {
        let desc = ImageViewDescriptor::new();
        assert!(desc.format.is_none());
        assert!(desc.subresource_range.is_none());
        assert_eq!(desc.view_type, ImageViewType::D2);
    }
}
