//! GPU image and image view resources.

use std::sync::Arc;

use crate::backend::{GpuImage, GpuImageView};
use crate::device::DeviceId;
use crate::types::{
    Extent3d, Format, ImageDescriptor, ImageSubresourceRange, ImageUsageFlags, ImageViewDescriptor,
    ImageViewType,
};

/// A GPU image resource.
///
/// Images are created by [`GraphicsDevice::create_image`], or owned by a
/// [`SwapChain`](crate::SwapChain).
///
/// [`GraphicsDevice::create_image`]: crate::GraphicsDevice::create_image
pub struct Image {
    device: DeviceId,
    descriptor: ImageDescriptor,
    pub(crate) gpu: GpuImage,
}

impl Image {
    /// Create a new image (called by GraphicsDevice).
    pub(crate) fn new(device: DeviceId, descriptor: ImageDescriptor, gpu: GpuImage) -> Self {
        Self {
            device,
            descriptor,
            gpu,
        }
    }

    /// The device that created this image.
    pub fn device_id(&self) -> DeviceId {
        self.device
    }

    /// Get the image descriptor.
    pub fn descriptor(&self) -> &ImageDescriptor {
        &self.descriptor
    }

    /// Get the image format.
    pub fn format(&self) -> Format {
        self.descriptor.format
    }

    /// Get the image extent of mip level 0.
    pub fn extent(&self) -> Extent3d {
        self.descriptor.extent
    }

    /// Get the number of mip levels.
    pub fn mip_levels(&self) -> u32 {
        self.descriptor.mip_levels
    }

    /// Get the number of array layers.
    pub fn array_layers(&self) -> u32 {
        self.descriptor.array_layers
    }

    /// Get the image usage flags.
    pub fn usage(&self) -> ImageUsageFlags {
        self.descriptor.usage
    }

    /// Get the image label, if set.
    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }

    /// Every mip level and array layer of every aspect of the format.
    pub fn full_range(&self) -> ImageSubresourceRange {
        ImageSubresourceRange {
            aspect_mask: self.descriptor.format.aspects(),
            base_mip_level: 0,
            level_count: self.descriptor.mip_levels,
            base_array_layer: 0,
            layer_count: self.descriptor.array_layers,
        }
    }
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("format", &self.descriptor.format)
            .field("extent", &self.descriptor.extent)
            .field("label", &self.descriptor.label)
            .finish()
    }
}

static_assertions::assert_impl_all!(Image: Send, Sync);

/// A view on a range of an [`Image`].
///
/// The view keeps its image alive. A descriptor without an explicit format
/// or subresource range inherits them from the image.
pub struct ImageView {
    image: Arc<Image>,
    descriptor: ImageViewDescriptor,
    format: Format,
    range: ImageSubresourceRange,
    pub(crate) gpu: GpuImageView,
}

impl ImageView {
    /// Resolves the effective format and range of a view descriptor.
    pub(crate) fn resolve(
        image: &Image,
        descriptor: &ImageViewDescriptor,
    ) -> (Format, ImageSubresourceRange) {
        let format = descriptor.format.unwrap_or(image.format());
        let range = descriptor
            .subresource_range
            .unwrap_or_else(|| image.full_range());
        (format, range)
    }

    pub(crate) fn new(
        image: Arc<Image>,
        descriptor: ImageViewDescriptor,
        gpu: GpuImageView,
    ) -> Self {
        let (format, range) = Self::resolve(&image, &descriptor);
        Self {
            image,
            descriptor,
            format,
            range,
            gpu,
        }
    }

    /// The device that created this view.
    pub fn device_id(&self) -> DeviceId {
        self.image.device_id()
    }

    /// The viewed image.
    pub fn image(&self) -> &Arc<Image> {
        &self.image
    }

    /// Effective format of the view.
    pub fn format(&self) -> Format {
        self.format
    }

    /// Effective subresource range of the view.
    pub fn subresource_range(&self) -> ImageSubresourceRange {
        self.range
    }

    /// Dimensionality of the view.
    pub fn view_type(&self) -> ImageViewType {
        self.descriptor.view_type
    }

    /// Get the view descriptor.
    pub fn descriptor(&self) -> &ImageViewDescriptor {
        &self.descriptor
    }

    /// Extent of the first viewed mip level.
    pub fn extent(&self) -> Extent3d {
        self.image.extent().mip_level(self.range.base_mip_level)
    }
}

impl std::fmt::Debug for ImageView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageView")
            .field("image", &self.image.label())
            .field("format", &self.format)
            .field("range", &self.range)
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(ImageView: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ImageAspectFlags, ImageUsageFlags};

    fn depth_image() -> Arc<Image> {
        let desc = ImageDescriptor::new_2d(
            64,
            32,
            Format::D24UnormS8Uint,
            ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
        )
        .with_mip_levels(3);
        Arc::new(Image::new(DeviceId::for_tests(), desc, GpuImage::Test))
    }

    #[test]
    fn test_full_range_covers_every_aspect() {
        let image = depth_image();
        let range = image.full_range();
        assert_eq!(
            range.aspect_mask,
            ImageAspectFlags::DEPTH | ImageAspectFlags::STENCIL
        );
        assert_eq!(range.level_count, 3);
    }

    #[test]
    fn test_view_inherits_format_and_range() {
        let image = depth_image();
        let view = ImageView::new(image.clone(), ImageViewDescriptor::new(), GpuImageView::Test);
        assert_eq!(view.format(), Format::D24UnormS8Uint);
        assert_eq!(view.subresource_range(), image.full_range());
        assert_eq!(view.device_id(), image.device_id());
    }

    #[test]
    fn test_view_extent_of_base_level() {
        let image = depth_image();
        let mut range = image.full_range();
        range.base_mip_level = 1;
        let view = ImageView::new(
            image,
            ImageViewDescriptor::new().with_subresource_range(range),
            GpuImageView::Test,
        );
        assert_eq!(view.extent(), Extent3d::new(32, 16, 1));
    }
}
