//! Render pass descriptions.

use super::{
    AccessFlags, DependencyFlags, Format, ImageLayout, PipelineBindPoint, PipelineStageFlags,
    SampleCount,
};

/// What happens to an attachment at the start of a render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AttachmentLoadOp {
    Load,
    Clear,
    #[default]
    DontCare,
}

/// What happens to an attachment at the end of a render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AttachmentStoreOp {
    #[default]
    Store,
    DontCare,
}

/// How the commands of a subpass are provided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SubpassContents {
    #[default]
    Inline,
    SecondaryCommandBuffers,
}

/// One attachment of a render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttachmentDescription {
    pub format: Format,
    pub samples: SampleCount,
    pub load_op: AttachmentLoadOp,
    pub store_op: AttachmentStoreOp,
    pub stencil_load_op: AttachmentLoadOp,
    pub stencil_store_op: AttachmentStoreOp,
    pub initial_layout: ImageLayout,
    pub final_layout: ImageLayout,
}

impl AttachmentDescription {
    /// An attachment cleared on load and stored at the end of the pass.
    pub fn cleared(format: Format, final_layout: ImageLayout) -> Self {
        Self {
            format,
            samples: SampleCount::X1,
            load_op: AttachmentLoadOp::Clear,
            store_op: AttachmentStoreOp::Store,
            stencil_load_op: if format.has_stencil() {
                AttachmentLoadOp::Clear
            } else {
                AttachmentLoadOp::DontCare
            },
            stencil_store_op: AttachmentStoreOp::DontCare,
            initial_layout: ImageLayout::Undefined,
            final_layout,
        }
    }

    /// An attachment whose previous contents are kept.
    pub fn loaded(format: Format, layout: ImageLayout) -> Self {
        Self {
            load_op: AttachmentLoadOp::Load,
            stencil_load_op: AttachmentLoadOp::Load,
            initial_layout: layout,
            ..Self::cleared(format, layout)
        }
    }

    /// Whether the colour or depth aspect is cleared on load.
    pub fn clears_on_load(&self) -> bool {
        self.load_op == AttachmentLoadOp::Clear
            || (self.format.has_stencil() && self.stencil_load_op == AttachmentLoadOp::Clear)
    }
}

/// Reference from a subpass to one attachment of the render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttachmentReference {
    pub attachment: u32,
    pub layout: ImageLayout,
}

impl AttachmentReference {
    /// Create an attachment reference.
    pub fn new(attachment: u32, layout: ImageLayout) -> Self {
        Self { attachment, layout }
    }
}

/// Attachments used by one subpass.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SubpassDescription {
    pub bind_point: PipelineBindPoint,
    pub input_attachments: Vec<AttachmentReference>,
    pub colour_attachments: Vec<AttachmentReference>,
    pub resolve_attachments: Vec<AttachmentReference>,
    pub depth_stencil_attachment: Option<AttachmentReference>,
    pub preserve_attachments: Vec<u32>,
}

impl SubpassDescription {
    /// A graphics subpass writing the given colour attachments.
    pub fn new(colour_attachments: Vec<AttachmentReference>) -> Self {
        Self {
            colour_attachments,
            ..Default::default()
        }
    }

    /// Set the depth/stencil attachment.
    pub fn with_depth_stencil(mut self, reference: AttachmentReference) -> Self {
        self.depth_stencil_attachment = Some(reference);
        self
    }
}

/// Index of the implicit subpass outside the render pass.
pub const SUBPASS_EXTERNAL: u32 = u32::MAX;

/// Attachment index of an unused attachment reference.
pub const ATTACHMENT_UNUSED: u32 = u32::MAX;

/// Execution and memory dependency between two subpasses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubpassDependency {
    pub src_subpass: u32,
    pub dst_subpass: u32,
    pub src_stage_mask: PipelineStageFlags,
    pub dst_stage_mask: PipelineStageFlags,
    pub src_access_mask: AccessFlags,
    pub dst_access_mask: AccessFlags,
    pub dependency_flags: DependencyFlags,
}

/// Descriptor for creating a render pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct RenderPassDescriptor {
    pub label: Option<String>,
    pub attachments: Vec<AttachmentDescription>,
    pub subpasses: Vec<SubpassDescription>,
    pub dependencies: Vec<SubpassDependency>,
}

impl RenderPassDescriptor {
    /// Create a render pass descriptor.
    pub fn new(attachments: Vec<AttachmentDescription>, subpasses: Vec<SubpassDescription>) -> Self {
        Self {
            label: None,
            attachments,
            subpasses,
            dependencies: Vec::new(),
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Add a subpass dependency.
    pub fn with_dependency(mut self, dependency: SubpassDependency) -> Self {
        self.dependencies.push(dependency);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleared_attachment() {
        let colour = AttachmentDescription::cleared(Format::Rgba8Unorm, ImageLayout::PresentSrc);
        assert!(colour.clears_on_load());
        assert_eq!(colour.stencil_load_op, AttachmentLoadOp::DontCare);

        let depth = AttachmentDescription::cleared(
            Format::D24UnormS8Uint,
            ImageLayout::DepthStencilAttachmentOptimal,
        );
        assert_eq!(depth.stencil_load_op, AttachmentLoadOp::Clear);
    }

    #[test]
    fn test_loaded_attachment_does_not_clear() {
        let colour =
            AttachmentDescription::loaded(Format::Rgba8Unorm, ImageLayout::ColourAttachmentOptimal);
        assert!(!colour.clears_on_load());
        assert_eq!(colour.initial_layout, ImageLayout::ColourAttachmentOptimal);
    }
}
