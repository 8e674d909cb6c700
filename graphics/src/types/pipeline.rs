//! Pipeline state descriptions, shader stages, descriptor layouts and push
//! constants.

use bitflags::bitflags;

use super::{
    BlendFactor, BlendOp, ColourComponentFlags, CompareOp, CullModeFlags, Format, FrontFace,
    LogicOp, PolygonMode, PrimitiveTopology, SampleCount, ShaderStageFlags, StencilOp,
};

// ============================================================================
// Vertex input
// ============================================================================

/// Whether a vertex binding advances per vertex or per instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VertexInputRate {
    #[default]
    Vertex,
    Instance,
}

/// A vertex buffer binding slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexInputBinding {
    pub binding: u32,
    pub stride: u32,
    pub input_rate: VertexInputRate,
}

/// A vertex attribute read from a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexInputAttribute {
    pub location: u32,
    pub binding: u32,
    pub format: Format,
    pub offset: u32,
}

/// Vertex input layout of a graphics pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct VertexInputState {
    pub bindings: Vec<VertexInputBinding>,
    pub attributes: Vec<VertexInputAttribute>,
}

impl VertexInputState {
    /// Add a binding.
    pub fn with_binding(mut self, binding: u32, stride: u32, input_rate: VertexInputRate) -> Self {
        self.bindings.push(VertexInputBinding {
            binding,
            stride,
            input_rate,
        });
        self
    }

    /// Add an attribute.
    pub fn with_attribute(mut self, location: u32, binding: u32, format: Format, offset: u32) -> Self {
        self.attributes.push(VertexInputAttribute {
            location,
            binding,
            format,
            offset,
        });
        self
    }

    /// Find the binding description of a binding slot.
    pub fn binding(&self, binding: u32) -> Option<&VertexInputBinding> {
        self.bindings.iter().find(|b| b.binding == binding)
    }
}

// ============================================================================
// Fixed-function state
// ============================================================================

/// Primitive assembly state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct InputAssemblyState {
    pub topology: PrimitiveTopology,
    pub primitive_restart: bool,
}

/// Rasterisation state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterisationState {
    pub depth_clamp: bool,
    pub rasteriser_discard: bool,
    pub polygon_mode: PolygonMode,
    pub cull_mode: CullModeFlags,
    pub front_face: FrontFace,
    pub depth_bias_enable: bool,
    pub depth_bias_constant_factor: f32,
    pub depth_bias_clamp: f32,
    pub depth_bias_slope_factor: f32,
    pub line_width: f32,
}

impl Default for RasterisationState {
    fn default() -> Self {
        Self {
            depth_clamp: false,
            rasteriser_discard: false,
            polygon_mode: PolygonMode::Fill,
            cull_mode: CullModeFlags::BACK,
            front_face: FrontFace::CounterClockwise,
            depth_bias_enable: false,
            depth_bias_constant_factor: 0.0,
            depth_bias_clamp: 0.0,
            depth_bias_slope_factor: 0.0,
            line_width: 1.0,
        }
    }
}

/// Multisample state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MultisampleState {
    pub samples: SampleCount,
    pub sample_shading: bool,
    pub min_sample_shading: f32,
    pub alpha_to_coverage: bool,
    pub alpha_to_one: bool,
}

/// Stencil state of one face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StencilOpState {
    pub fail_op: StencilOp,
    pub pass_op: StencilOp,
    pub depth_fail_op: StencilOp,
    pub compare_op: CompareOp,
    pub compare_mask: u32,
    pub write_mask: u32,
    pub reference: u32,
}

impl Default for StencilOpState {
    fn default() -> Self {
        Self {
            fail_op: StencilOp::Keep,
            pass_op: StencilOp::Keep,
            depth_fail_op: StencilOp::Keep,
            compare_op: CompareOp::Always,
            compare_mask: 0xff,
            write_mask: 0xff,
            reference: 0,
        }
    }
}

/// Depth and stencil test state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthStencilState {
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_compare: CompareOp,
    pub depth_bounds_test: bool,
    pub stencil_test: bool,
    pub front: StencilOpState,
    pub back: StencilOpState,
    pub min_depth_bounds: f32,
    pub max_depth_bounds: f32,
}

impl Default for DepthStencilState {
    fn default() -> Self {
        Self {
            depth_test: true,
            depth_write: true,
            depth_compare: CompareOp::Less,
            depth_bounds_test: false,
            stencil_test: false,
            front: StencilOpState::default(),
            back: StencilOpState::default(),
            min_depth_bounds: 0.0,
            max_depth_bounds: 1.0,
        }
    }
}

/// Blend state of one colour attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColourBlendAttachmentState {
    pub blend_enable: bool,
    pub src_colour: BlendFactor,
    pub dst_colour: BlendFactor,
    pub colour_op: BlendOp,
    pub src_alpha: BlendFactor,
    pub dst_alpha: BlendFactor,
    pub alpha_op: BlendOp,
    pub write_mask: ColourComponentFlags,
}

impl ColourBlendAttachmentState {
    /// Standard "over" alpha blending.
    pub fn alpha_blending() -> Self {
        Self {
            blend_enable: true,
            src_colour: BlendFactor::SrcAlpha,
            dst_colour: BlendFactor::OneMinusSrcAlpha,
            src_alpha: BlendFactor::One,
            dst_alpha: BlendFactor::OneMinusSrcAlpha,
            ..Self::default()
        }
    }
}

impl Default for ColourBlendAttachmentState {
    fn default() -> Self {
        Self {
            blend_enable: false,
            src_colour: BlendFactor::One,
            dst_colour: BlendFactor::Zero,
            colour_op: BlendOp::Add,
            src_alpha: BlendFactor::One,
            dst_alpha: BlendFactor::Zero,
            alpha_op: BlendOp::Add,
            write_mask: ColourComponentFlags::all(),
        }
    }
}

/// Colour blend state of a graphics pipeline.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColourBlendState {
    pub logic_op: Option<LogicOp>,
    pub attachments: Vec<ColourBlendAttachmentState>,
    pub blend_constants: [f32; 4],
}

impl ColourBlendState {
    /// One attachment with the given blend state.
    pub fn single(attachment: ColourBlendAttachmentState) -> Self {
        Self {
            attachments: vec![attachment],
            ..Self::default()
        }
    }
}

/// Tessellation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TessellationState {
    pub patch_control_points: u32,
}

bitflags! {
    /// Pipeline state provided by commands instead of by the pipeline.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DynamicStateFlags: u32 {
        const VIEWPORT = 1 << 0;
        const SCISSOR = 1 << 1;
        const LINE_WIDTH = 1 << 2;
        const DEPTH_BIAS = 1 << 3;
        const BLEND_CONSTANTS = 1 << 4;
        const DEPTH_BOUNDS = 1 << 5;
        const STENCIL_COMPARE_MASK = 1 << 6;
        const STENCIL_WRITE_MASK = 1 << 7;
        const STENCIL_REFERENCE = 1 << 8;
    }
}

// ============================================================================
// Shaders
// ============================================================================

/// Shader code, forwarded as-is to the native API.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ShaderSource {
    /// GLSL source, consumed by the GL backends.
    Glsl(String),
    /// SPIR-V words, consumed by the Vulkan backend.
    SpirV(Vec<u32>),
}

/// One programmable stage of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderStage {
    pub stage: ShaderStageFlags,
    pub source: ShaderSource,
    pub entry_point: String,
}

impl ShaderStage {
    /// A stage with the `main` entry point.
    pub fn new(stage: ShaderStageFlags, source: ShaderSource) -> Self {
        Self {
            stage,
            source,
            entry_point: "main".to_string(),
        }
    }
}

// ============================================================================
// Descriptors
// ============================================================================

/// Type of resource bound through a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorType {
    Sampler,
    CombinedImageSampler,
    SampledImage,
    StorageImage,
    UniformTexelBuffer,
    StorageTexelBuffer,
    UniformBuffer,
    StorageBuffer,
    UniformBufferDynamic,
    StorageBufferDynamic,
    InputAttachment,
}

impl DescriptorType {
    /// Whether the descriptor refers to a buffer range.
    pub fn is_buffer(&self) -> bool {
        matches!(
            self,
            Self::UniformBuffer
                | Self::StorageBuffer
                | Self::UniformBufferDynamic
                | Self::StorageBufferDynamic
        )
    }
}

/// One binding of a descriptor set layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorSetLayoutBinding {
    pub binding: u32,
    pub descriptor_type: DescriptorType,
    pub count: u32,
    pub stages: ShaderStageFlags,
}

impl DescriptorSetLayoutBinding {
    /// A single descriptor visible to the given stages.
    pub fn new(binding: u32, descriptor_type: DescriptorType, stages: ShaderStageFlags) -> Self {
        Self {
            binding,
            descriptor_type,
            count: 1,
            stages,
        }
    }

    /// Make the binding an array of `count` descriptors.
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }
}

/// A push constant range of a pipeline layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PushConstantRange {
    pub stages: ShaderStageFlags,
    pub offset: u32,
    pub size: u32,
}

// ============================================================================
// Push constants
// ============================================================================

/// Shader-side type of one push constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstantFormat {
    Float,
    Vec2f,
    Vec3f,
    Vec4f,
    Mat2f,
    Mat3f,
    Mat4f,
    Int,
    Vec2i,
    Vec3i,
    Vec4i,
    UInt,
    Vec2ui,
    Vec3ui,
    Vec4ui,
    /// RGBA colour, uploaded as a vec4f.
    Colour,
}

impl ConstantFormat {
    /// Size in bytes of one value of this format.
    pub fn size(&self) -> usize {
        match self {
            Self::Float | Self::Int | Self::UInt => 4,
            Self::Vec2f | Self::Vec2i | Self::Vec2ui => 8,
            Self::Vec3f | Self::Vec3i | Self::Vec3ui => 12,
            Self::Vec4f | Self::Vec4i | Self::Vec4ui | Self::Colour | Self::Mat2f => 16,
            Self::Mat3f => 36,
            Self::Mat4f => 64,
        }
    }
}

/// One named constant of a push constant block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PushConstant {
    /// Uniform location in the GL program.
    pub location: u32,
    pub format: ConstantFormat,
}

/// A push constant update: declared constants and their packed values.
///
/// Values are read in declaration order, each one occupying
/// [`ConstantFormat::size`] bytes of `data`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PushConstantsDesc {
    pub stages: ShaderStageFlags,
    /// Byte offset of the block inside the layout's push constant range.
    pub offset: u32,
    pub constants: Vec<PushConstant>,
    pub data: Vec<u8>,
}

impl PushConstantsDesc {
    /// Create an update with no declared constants.
    pub fn new(stages: ShaderStageFlags, offset: u32) -> Self {
        Self {
            stages,
            offset,
            constants: Vec::new(),
            data: Vec::new(),
        }
    }

    /// Declare the next constant.
    pub fn with_constant(mut self, location: u32, format: ConstantFormat) -> Self {
        self.constants.push(PushConstant { location, format });
        self
    }

    /// Set the packed values.
    pub fn with_data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.data = data.into();
        self
    }

    /// Number of bytes the declared constants read.
    pub fn required_size(&self) -> usize {
        self.constants.iter().map(|c| c.format.size()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_format_sizes() {
        assert_eq!(ConstantFormat::Float.size(), 4);
        assert_eq!(ConstantFormat::Vec3i.size(), 12);
        assert_eq!(ConstantFormat::Colour.size(), 16);
        assert_eq!(ConstantFormat::Mat3f.size(), 36);
        assert_eq!(ConstantFormat::Mat4f.size(), 64);
    }

    #[test]
    fn test_push_constants_required_size() {
        let desc = PushConstantsDesc::new(ShaderStageFlags::VERTEX, 0)
            .with_constant(0, ConstantFormat::Float)
            .with_constant(4, ConstantFormat::Vec4f);
        assert_eq!(desc.required_size(), 20);
    }

    #[test]
    fn test_vertex_input_lookup() {
        let state = VertexInputState::default()
            .with_binding(1, 12, VertexInputRate::Instance)
            .with_attribute(0, 1, Format::Rgb32Float, 0);
        assert_eq!(state.binding(1).map(|b| b.stride), Some(12));
        assert!(state.binding(0).is_none());
    }
}
