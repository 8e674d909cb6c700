//! Render pass and framebuffer resources.

use std::sync::Arc;

use crate::backend::{GpuFramebuffer, GpuLayoutObject};
use crate::device::DeviceId;
use crate::resources::ImageView;
use crate::types::{AttachmentDescription, Extent2d, RenderPassDescriptor, SubpassDescription};

/// A render pass: attachments, subpasses and their dependencies.
pub struct RenderPass {
    device: DeviceId,
    descriptor: RenderPassDescriptor,
    pub(crate) gpu: GpuLayoutObject,
}

impl RenderPass {
    pub(crate) fn new(device: DeviceId, descriptor: RenderPassDescriptor, gpu: GpuLayoutObject) -> Self {
        Self {
            device,
            descriptor,
            gpu,
        }
    }

    /// The device that created this render pass.
    pub fn device_id(&self) -> DeviceId {
        self.device
    }

    /// Get the render pass descriptor.
    pub fn descriptor(&self) -> &RenderPassDescriptor {
        &self.descriptor
    }

    /// Attachments of the render pass.
    pub fn attachments(&self) -> &[AttachmentDescription] {
        &self.descriptor.attachments
    }

    /// Number of subpasses.
    pub fn subpass_count(&self) -> u32 {
        self.descriptor.subpasses.len() as u32
    }

    /// Description of subpass `index`.
    ///
    /// # Panics
    ///
    /// Panics if the render pass has no such subpass.
    pub fn subpass(&self, index: u32) -> &SubpassDescription {
        self.descriptor
            .subpasses
            .get(index as usize)
            .unwrap_or_else(|| panic!("render pass has no subpass {index}"))
    }

    /// Get the render pass label, if set.
    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }
}

impl std::fmt::Debug for RenderPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderPass")
            .field("attachments", &self.descriptor.attachments.len())
            .field("subpasses", &self.descriptor.subpasses.len())
            .field("label", &self.descriptor.label)
            .finish()
    }
}

static_assertions::assert_impl_all!(RenderPass: Send, Sync);

/// The image views a render pass draws into.
///
/// View `i` backs attachment `i` of the render pass.
pub struct Framebuffer {
    device: DeviceId,
    render_pass: Arc<RenderPass>,
    attachments: Vec<Arc<ImageView>>,
    extent: Extent2d,
    layers: u32,
    pub(crate) gpu: GpuFramebuffer,
}

impl Framebuffer {
    pub(crate) fn new(
        device: DeviceId,
        render_pass: Arc<RenderPass>,
        attachments: Vec<Arc<ImageView>>,
        extent: Extent2d,
        layers: u32,
        gpu: GpuFramebuffer,
    ) -> Self {
        Self {
            device,
            render_pass,
            attachments,
            extent,
            layers,
            gpu,
        }
    }

    /// The device that created this framebuffer.
    pub fn device_id(&self) -> DeviceId {
        self.device
    }

    /// The render pass this framebuffer is compatible with.
    pub fn render_pass(&self) -> &Arc<RenderPass> {
        &self.render_pass
    }

    /// Attachment views, in render pass attachment order.
    pub fn attachments(&self) -> &[Arc<ImageView>] {
        &self.attachments
    }

    /// Size of the framebuffer.
    pub fn extent(&self) -> Extent2d {
        self.extent
    }

    /// Number of layers.
    pub fn layers(&self) -> u32 {
        self.layers
    }
}

impl std::fmt::Debug for Framebuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Framebuffer")
            .field("extent", &self.extent)
            .field("layers", &self.layers)
            .field("attachments", &self.attachments.len())
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(Framebuffer: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AttachmentReference, Format, ImageLayout};

    #[test]
    fn test_subpass_lookup() {
        let desc = RenderPassDescriptor::new(
            vec![AttachmentDescription::cleared(
                Format::Rgba8Unorm,
                ImageLayout::PresentSrc,
            )],
            vec![SubpassDescription::new(vec![AttachmentReference::new(
                0,
                ImageLayout::ColourAttachmentOptimal,
            )])],
        );
        let pass = RenderPass::new(DeviceId::for_tests(), desc, GpuLayoutObject::Emulated);
        assert_eq!(pass.subpass_count(), 1);
        assert_eq!(pass.subpass(0).colour_attachments.len(), 1);
    }

    #[test]
    #[should_panic(expected = "no subpass 2")]
    fn test_missing_subpass_panics() {
        let pass = RenderPass::new(
            DeviceId::for_tests(),
            RenderPassDescriptor::default(),
            GpuLayoutObject::Emulated,
        );
        pass.subpass(2);
    }
}
