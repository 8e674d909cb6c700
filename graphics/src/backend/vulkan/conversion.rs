//! Conversions from ashes types to Vulkan types.
//!
//! The bitflag types share their bit layout with Vulkan and convert with
//! `from_raw`; enums are matched variant by variant.

use ash::vk;

use crate::types::{
    AccessFlags, AddressMode, AttachmentLoadOp, AttachmentStoreOp, BlendFactor, BlendOp,
    BorderColour, BufferUsageFlags, ClearColourValue, ClearValue, ColourComponentFlags,
    CommandBufferUsageFlags, CompareOp, ComponentMapping, ComponentSwizzle, CullModeFlags,
    DependencyFlags, DescriptorType, DynamicStateFlags, Extent2d, Extent3d, Filter, Format,
    FrontFace, ImageAspectFlags, ImageLayout, ImageSubresourceLayers, ImageSubresourceRange,
    ImageType, ImageUsageFlags, ImageViewType, IndexType, LogicOp, MipmapMode, Offset2d,
    Offset3d, PipelineBindPoint, PipelineStageFlags, PolygonMode, PrimitiveTopology,
    QueryControlFlags, QueryResultFlags, QueryType, Rect2d, SampleCount, ShaderStageFlags,
    StencilFaceFlags, StencilOp, StencilOpState, SubpassContents, VertexInputRate, Viewport,
};

// ============================================================================
// Flags
// ============================================================================

pub fn convert_buffer_usage(usage: BufferUsageFlags) -> vk::BufferUsageFlags {
    vk::BufferUsageFlags::from_raw(usage.bits())
}

pub fn convert_image_usage(usage: ImageUsageFlags) -> vk::ImageUsageFlags {
    vk::ImageUsageFlags::from_raw(usage.bits())
}

pub fn convert_pipeline_stages(stages: PipelineStageFlags) -> vk::PipelineStageFlags {
    vk::PipelineStageFlags::from_raw(stages.bits())
}

pub fn convert_access(access: AccessFlags) -> vk::AccessFlags {
    vk::AccessFlags::from_raw(access.bits())
}

pub fn convert_dependency_flags(flags: DependencyFlags) -> vk::DependencyFlags {
    vk::DependencyFlags::from_raw(flags.bits())
}

pub fn convert_shader_stages(stages: ShaderStageFlags) -> vk::ShaderStageFlags {
    vk::ShaderStageFlags::from_raw(stages.bits())
}

pub fn convert_aspect(aspect: ImageAspectFlags) -> vk::ImageAspectFlags {
    vk::ImageAspectFlags::from_raw(aspect.bits())
}

pub fn convert_colour_components(mask: ColourComponentFlags) -> vk::ColorComponentFlags {
    vk::ColorComponentFlags::from_raw(mask.bits())
}

pub fn convert_cull_mode(mode: CullModeFlags) -> vk::CullModeFlags {
    vk::CullModeFlags::from_raw(mode.bits())
}

pub fn convert_stencil_faces(faces: StencilFaceFlags) -> vk::StencilFaceFlags {
    vk::StencilFaceFlags::from_raw(faces.bits())
}

pub fn convert_command_buffer_usage(usage: CommandBufferUsageFlags) -> vk::CommandBufferUsageFlags {
    vk::CommandBufferUsageFlags::from_raw(usage.bits())
}

pub fn convert_query_control(flags: QueryControlFlags) -> vk::QueryControlFlags {
    vk::QueryControlFlags::from_raw(flags.bits())
}

pub fn convert_query_result_flags(flags: QueryResultFlags) -> vk::QueryResultFlags {
    vk::QueryResultFlags::from_raw(flags.bits())
}

/// Dynamic state flags have their own bit layout and map to a list.
pub fn convert_dynamic_states(flags: DynamicStateFlags) -> Vec<vk::DynamicState> {
    const TABLE: [(DynamicStateFlags, vk::DynamicState); 9] = [
        (DynamicStateFlags::VIEWPORT, vk::DynamicState::VIEWPORT),
        (DynamicStateFlags::SCISSOR, vk::DynamicState::SCISSOR),
        (DynamicStateFlags::LINE_WIDTH, vk::DynamicState::LINE_WIDTH),
        (DynamicStateFlags::DEPTH_BIAS, vk::DynamicState::DEPTH_BIAS),
        (DynamicStateFlags::BLEND_CONSTANTS, vk::DynamicState::BLEND_CONSTANTS),
        (DynamicStateFlags::DEPTH_BOUNDS, vk::DynamicState::DEPTH_BOUNDS),
        (
            DynamicStateFlags::STENCIL_COMPARE_MASK,
            vk::DynamicState::STENCIL_COMPARE_MASK,
        ),
        (
            DynamicStateFlags::STENCIL_WRITE_MASK,
            vk::DynamicState::STENCIL_WRITE_MASK,
        ),
        (
            DynamicStateFlags::STENCIL_REFERENCE,
            vk::DynamicState::STENCIL_REFERENCE,
        ),
    ];
    TABLE
        .iter()
        .filter(|(flag, _)| flags.contains(*flag))
        .map(|(_, state)| *state)
        .collect()
}

// ============================================================================
// Formats
// ============================================================================

pub fn convert_format(format: Format) -> vk::Format {
    match format {
        Format::R8Unorm => vk::Format::R8_UNORM,
        Format::R8Snorm => vk::Format::R8_SNORM,
        Format::R8Uint => vk::Format::R8_UINT,
        Format::R8Sint => vk::Format::R8_SINT,
        Format::Rg8Unorm => vk::Format::R8G8_UNORM,
        Format::Rgba8Unorm => vk::Format::R8G8B8A8_UNORM,
        Format::Rgba8Snorm => vk::Format::R8G8B8A8_SNORM,
        Format::Rgba8Srgb => vk::Format::R8G8B8A8_SRGB,
        Format::Rgba8Uint => vk::Format::R8G8B8A8_UINT,
        Format::Bgra8Unorm => vk::Format::B8G8R8A8_UNORM,
        Format::Bgra8Srgb => vk::Format::B8G8R8A8_SRGB,

        Format::R16Float => vk::Format::R16_SFLOAT,
        Format::R16Uint => vk::Format::R16_UINT,
        Format::Rg16Float => vk::Format::R16G16_SFLOAT,
        Format::Rgba16Float => vk::Format::R16G16B16A16_SFLOAT,

        Format::R32Float => vk::Format::R32_SFLOAT,
        Format::R32Uint => vk::Format::R32_UINT,
        Format::R32Sint => vk::Format::R32_SINT,
        Format::Rg32Float => vk::Format::R32G32_SFLOAT,
        Format::Rg32Uint => vk::Format::R32G32_UINT,
        Format::Rg32Sint => vk::Format::R32G32_SINT,
        Format::Rgb32Float => vk::Format::R32G32B32_SFLOAT,
        Format::Rgba32Float => vk::Format::R32G32B32A32_SFLOAT,
        Format::Rgba32Uint => vk::Format::R32G32B32A32_UINT,
        Format::Rgba32Sint => vk::Format::R32G32B32A32_SINT,

        Format::A2b10g10r10Unorm => vk::Format::A2B10G10R10_UNORM_PACK32,
        Format::B10g11r11Ufloat => vk::Format::B10G11R11_UFLOAT_PACK32,

        Format::D16Unorm => vk::Format::D16_UNORM,
        Format::X8D24Unorm => vk::Format::X8_D24_UNORM_PACK32,
        Format::D32Float => vk::Format::D32_SFLOAT,
        Format::S8Uint => vk::Format::S8_UINT,
        Format::D24UnormS8Uint => vk::Format::D24_UNORM_S8_UINT,
        Format::D32FloatS8Uint => vk::Format::D32_SFLOAT_S8_UINT,
    }
}

/// The ashes format of a surface format, if it has one.
pub fn format_from_vk(format: vk::Format) -> Option<Format> {
    Some(match format {
        vk::Format::R8G8B8A8_UNORM => Format::Rgba8Unorm,
        vk::Format::R8G8B8A8_SRGB => Format::Rgba8Srgb,
        vk::Format::B8G8R8A8_UNORM => Format::Bgra8Unorm,
        vk::Format::B8G8R8A8_SRGB => Format::Bgra8Srgb,
        vk::Format::A2B10G10R10_UNORM_PACK32 => Format::A2b10g10r10Unorm,
        vk::Format::R16G16B16A16_SFLOAT => Format::Rgba16Float,
        _ => return None,
    })
}

// ============================================================================
// Fixed-function enums
// ============================================================================

pub fn convert_compare_op(op: CompareOp) -> vk::CompareOp {
    match op {
        CompareOp::Never => vk::CompareOp::NEVER,
        CompareOp::Less => vk::CompareOp::LESS,
        CompareOp::Equal => vk::CompareOp::EQUAL,
        CompareOp::LessOrEqual => vk::CompareOp::LESS_OR_EQUAL,
        CompareOp::Greater => vk::CompareOp::GREATER,
        CompareOp::NotEqual => vk::CompareOp::NOT_EQUAL,
        CompareOp::GreaterOrEqual => vk::CompareOp::GREATER_OR_EQUAL,
        CompareOp::Always => vk::CompareOp::ALWAYS,
    }
}

pub fn convert_stencil_op(op: StencilOp) -> vk::StencilOp {
    match op {
        StencilOp::Keep => vk::StencilOp::KEEP,
        StencilOp::Zero => vk::StencilOp::ZERO,
        StencilOp::Replace => vk::StencilOp::REPLACE,
        StencilOp::IncrementAndClamp => vk::StencilOp::INCREMENT_AND_CLAMP,
        StencilOp::DecrementAndClamp => vk::StencilOp::DECREMENT_AND_CLAMP,
        StencilOp::Invert => vk::StencilOp::INVERT,
        StencilOp::IncrementAndWrap => vk::StencilOp::INCREMENT_AND_WRAP,
        StencilOp::DecrementAndWrap => vk::StencilOp::DECREMENT_AND_WRAP,
    }
}

pub fn convert_stencil_state(state: &StencilOpState) -> vk::StencilOpState {
    vk::StencilOpState {
        fail_op: convert_stencil_op(state.fail_op),
        pass_op: convert_stencil_op(state.pass_op),
        depth_fail_op: convert_stencil_op(state.depth_fail_op),
        compare_op: convert_compare_op(state.compare_op),
        compare_mask: state.compare_mask,
        write_mask: state.write_mask,
        reference: state.reference,
    }
}

pub fn convert_blend_factor(factor: BlendFactor) -> vk::BlendFactor {
    match factor {
        BlendFactor::Zero => vk::BlendFactor::ZERO,
        BlendFactor::One => vk::BlendFactor::ONE,
        BlendFactor::SrcColour => vk::BlendFactor::SRC_COLOR,
        BlendFactor::OneMinusSrcColour => vk::BlendFactor::ONE_MINUS_SRC_COLOR,
        BlendFactor::DstColour => vk::BlendFactor::DST_COLOR,
        BlendFactor::OneMinusDstColour => vk::BlendFactor::ONE_MINUS_DST_COLOR,
        BlendFactor::SrcAlpha => vk::BlendFactor::SRC_ALPHA,
        BlendFactor::OneMinusSrcAlpha => vk::BlendFactor::ONE_MINUS_SRC_ALPHA,
        BlendFactor::DstAlpha => vk::BlendFactor::DST_ALPHA,
        BlendFactor::OneMinusDstAlpha => vk::BlendFactor::ONE_MINUS_DST_ALPHA,
        BlendFactor::ConstantColour => vk::BlendFactor::CONSTANT_COLOR,
        BlendFactor::OneMinusConstantColour => vk::BlendFactor::ONE_MINUS_CONSTANT_COLOR,
        BlendFactor::ConstantAlpha => vk::BlendFactor::CONSTANT_ALPHA,
        BlendFactor::OneMinusConstantAlpha => vk::BlendFactor::ONE_MINUS_CONSTANT_ALPHA,
        BlendFactor::SrcAlphaSaturate => vk::BlendFactor::SRC_ALPHA_SATURATE,
        BlendFactor::Src1Colour => vk::BlendFactor::SRC1_COLOR,
        BlendFactor::OneMinusSrc1Colour => vk::BlendFactor::ONE_MINUS_SRC1_COLOR,
        BlendFactor::Src1Alpha => vk::BlendFactor::SRC1_ALPHA,
        BlendFactor::OneMinusSrc1Alpha => vk::BlendFactor::ONE_MINUS_SRC1_ALPHA,
    }
}

pub fn convert_blend_op(op: BlendOp) -> vk::BlendOp {
    match op {
        BlendOp::Add => vk::BlendOp::ADD,
        BlendOp::Subtract => vk::BlendOp::SUBTRACT,
        BlendOp::ReverseSubtract => vk::BlendOp::REVERSE_SUBTRACT,
        BlendOp::Min => vk::BlendOp::MIN,
        BlendOp::Max => vk::BlendOp::MAX,
    }
}

pub fn convert_logic_op(op: LogicOp) -> vk::LogicOp {
    match op {
        LogicOp::Clear => vk::LogicOp::CLEAR,
        LogicOp::And => vk::LogicOp::AND,
        LogicOp::AndReverse => vk::LogicOp::AND_REVERSE,
        LogicOp::Copy => vk::LogicOp::COPY,
        LogicOp::AndInverted => vk::LogicOp::AND_INVERTED,
        LogicOp::NoOp => vk::LogicOp::NO_OP,
        LogicOp::Xor => vk::LogicOp::XOR,
        LogicOp::Or => vk::LogicOp::OR,
        LogicOp::Nor => vk::LogicOp::NOR,
        LogicOp::Equivalent => vk::LogicOp::EQUIVALENT,
        LogicOp::Invert => vk::LogicOp::INVERT,
        LogicOp::OrReverse => vk::LogicOp::OR_REVERSE,
        LogicOp::CopyInverted => vk::LogicOp::COPY_INVERTED,
        LogicOp::OrInverted => vk::LogicOp::OR_INVERTED,
        LogicOp::Nand => vk::LogicOp::NAND,
        LogicOp::Set => vk::LogicOp::SET,
    }
}

pub fn convert_polygon_mode(mode: PolygonMode) -> vk::PolygonMode {
    match mode {
        PolygonMode::Fill => vk::PolygonMode::FILL,
        PolygonMode::Line => vk::PolygonMode::LINE,
        PolygonMode::Point => vk::PolygonMode::POINT,
    }
}

pub fn convert_front_face(face: FrontFace) -> vk::FrontFace {
    match face {
        FrontFace::CounterClockwise => vk::FrontFace::COUNTER_CLOCKWISE,
        FrontFace::Clockwise => vk::FrontFace::CLOCKWISE,
    }
}

pub fn convert_topology(topology: PrimitiveTopology) -> vk::PrimitiveTopology {
    match topology {
        PrimitiveTopology::PointList => vk::PrimitiveTopology::POINT_LIST,
        PrimitiveTopology::LineList => vk::PrimitiveTopology::LINE_LIST,
        PrimitiveTopology::LineStrip => vk::PrimitiveTopology::LINE_STRIP,
        PrimitiveTopology::TriangleList => vk::PrimitiveTopology::TRIANGLE_LIST,
        PrimitiveTopology::TriangleStrip => vk::PrimitiveTopology::TRIANGLE_STRIP,
        PrimitiveTopology::TriangleFan => vk::PrimitiveTopology::TRIANGLE_FAN,
        PrimitiveTopology::LineListWithAdjacency => {
            vk::PrimitiveTopology::LINE_LIST_WITH_ADJACENCY
        }
        PrimitiveTopology::LineStripWithAdjacency => {
            vk::PrimitiveTopology::LINE_STRIP_WITH_ADJACENCY
        }
        PrimitiveTopology::TriangleListWithAdjacency => {
            vk::PrimitiveTopology::TRIANGLE_LIST_WITH_ADJACENCY
        }
        PrimitiveTopology::TriangleStripWithAdjacency => {
            vk::PrimitiveTopology::TRIANGLE_STRIP_WITH_ADJACENCY
        }
        PrimitiveTopology::PatchList => vk::PrimitiveTopology::PATCH_LIST,
    }
}

pub fn convert_index_type(index_type: IndexType) -> vk::IndexType {
    match index_type {
        IndexType::Uint16 => vk::IndexType::UINT16,
        IndexType::Uint32 => vk::IndexType::UINT32,
    }
}

pub fn convert_bind_point(bind_point: PipelineBindPoint) -> vk::PipelineBindPoint {
    match bind_point {
        PipelineBindPoint::Graphics => vk::PipelineBindPoint::GRAPHICS,
        PipelineBindPoint::Compute => vk::PipelineBindPoint::COMPUTE,
    }
}

pub fn convert_query_type(query_type: QueryType) -> vk::QueryType {
    match query_type {
        QueryType::Occlusion => vk::QueryType::OCCLUSION,
        QueryType::PipelineStatistics => vk::QueryType::PIPELINE_STATISTICS,
        QueryType::Timestamp => vk::QueryType::TIMESTAMP,
    }
}

pub fn convert_vertex_input_rate(rate: VertexInputRate) -> vk::VertexInputRate {
    match rate {
        VertexInputRate::Vertex => vk::VertexInputRate::VERTEX,
        VertexInputRate::Instance => vk::VertexInputRate::INSTANCE,
    }
}

pub fn convert_descriptor_type(ty: DescriptorType) -> vk::DescriptorType {
    match ty {
        DescriptorType::Sampler => vk::DescriptorType::SAMPLER,
        DescriptorType::CombinedImageSampler => vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
        DescriptorType::SampledImage => vk::DescriptorType::SAMPLED_IMAGE,
        DescriptorType::StorageImage => vk::DescriptorType::STORAGE_IMAGE,
        DescriptorType::UniformTexelBuffer => vk::DescriptorType::UNIFORM_TEXEL_BUFFER,
        DescriptorType::StorageTexelBuffer => vk::DescriptorType::STORAGE_TEXEL_BUFFER,
        DescriptorType::UniformBuffer => vk::DescriptorType::UNIFORM_BUFFER,
        DescriptorType::StorageBuffer => vk::DescriptorType::STORAGE_BUFFER,
        DescriptorType::UniformBufferDynamic => vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC,
        DescriptorType::StorageBufferDynamic => vk::DescriptorType::STORAGE_BUFFER_DYNAMIC,
        DescriptorType::InputAttachment => vk::DescriptorType::INPUT_ATTACHMENT,
    }
}

// ============================================================================
// Images
// ============================================================================

pub fn convert_image_type(image_type: ImageType) -> vk::ImageType {
    match image_type {
        ImageType::D1 => vk::ImageType::TYPE_1D,
        ImageType::D2 => vk::ImageType::TYPE_2D,
        ImageType::D3 => vk::ImageType::TYPE_3D,
    }
}

pub fn convert_view_type(view_type: ImageViewType) -> vk::ImageViewType {
    match view_type {
        ImageViewType::D1 => vk::ImageViewType::TYPE_1D,
        ImageViewType::D2 => vk::ImageViewType::TYPE_2D,
        ImageViewType::D3 => vk::ImageViewType::TYPE_3D,
        ImageViewType::Cube => vk::ImageViewType::CUBE,
        ImageViewType::D1Array => vk::ImageViewType::TYPE_1D_ARRAY,
        ImageViewType::D2Array => vk::ImageViewType::TYPE_2D_ARRAY,
        ImageViewType::CubeArray => vk::ImageViewType::CUBE_ARRAY,
    }
}

pub fn convert_samples(samples: SampleCount) -> vk::SampleCountFlags {
    vk::SampleCountFlags::from_raw(samples.count())
}

pub fn convert_layout(layout: ImageLayout) -> vk::ImageLayout {
    match layout {
        ImageLayout::Undefined => vk::ImageLayout::UNDEFINED,
        ImageLayout::General => vk::ImageLayout::GENERAL,
        ImageLayout::ColourAttachmentOptimal => vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        ImageLayout::DepthStencilAttachmentOptimal => {
            vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
        }
        ImageLayout::DepthStencilReadOnlyOptimal => vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL,
        ImageLayout::ShaderReadOnlyOptimal => vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        ImageLayout::TransferSrcOptimal => vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
        ImageLayout::TransferDstOptimal => vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        ImageLayout::Preinitialized => vk::ImageLayout::PREINITIALIZED,
        ImageLayout::PresentSrc => vk::ImageLayout::PRESENT_SRC_KHR,
    }
}

fn convert_swizzle(swizzle: ComponentSwizzle) -> vk::ComponentSwizzle {
    match swizzle {
        ComponentSwizzle::Identity => vk::ComponentSwizzle::IDENTITY,
        ComponentSwizzle::Zero => vk::ComponentSwizzle::ZERO,
        ComponentSwizzle::One => vk::ComponentSwizzle::ONE,
        ComponentSwizzle::R => vk::ComponentSwizzle::R,
        ComponentSwizzle::G => vk::ComponentSwizzle::G,
        ComponentSwizzle::B => vk::ComponentSwizzle::B,
        ComponentSwizzle::A => vk::ComponentSwizzle::A,
    }
}

pub fn convert_components(mapping: &ComponentMapping) -> vk::ComponentMapping {
    vk::ComponentMapping {
        r: convert_swizzle(mapping.r),
        g: convert_swizzle(mapping.g),
        b: convert_swizzle(mapping.b),
        a: convert_swizzle(mapping.a),
    }
}

pub fn convert_subresource_range(range: &ImageSubresourceRange) -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask: convert_aspect(range.aspect_mask),
        base_mip_level: range.base_mip_level,
        level_count: range.level_count,
        base_array_layer: range.base_array_layer,
        layer_count: range.layer_count,
    }
}

pub fn convert_subresource_layers(layers: &ImageSubresourceLayers) -> vk::ImageSubresourceLayers {
    vk::ImageSubresourceLayers {
        aspect_mask: convert_aspect(layers.aspect_mask),
        mip_level: layers.mip_level,
        base_array_layer: layers.base_array_layer,
        layer_count: layers.layer_count,
    }
}

// ============================================================================
// Samplers
// ============================================================================

pub fn convert_filter(filter: Filter) -> vk::Filter {
    match filter {
        Filter::Nearest => vk::Filter::NEAREST,
        Filter::Linear => vk::Filter::LINEAR,
    }
}

pub fn convert_mipmap_mode(mode: MipmapMode) -> vk::SamplerMipmapMode {
    match mode {
        MipmapMode::Nearest => vk::SamplerMipmapMode::NEAREST,
        MipmapMode::Linear => vk::SamplerMipmapMode::LINEAR,
    }
}

pub fn convert_address_mode(mode: AddressMode) -> vk::SamplerAddressMode {
    match mode {
        AddressMode::Repeat => vk::SamplerAddressMode::REPEAT,
        AddressMode::MirroredRepeat => vk::SamplerAddressMode::MIRRORED_REPEAT,
        AddressMode::ClampToEdge => vk::SamplerAddressMode::CLAMP_TO_EDGE,
        AddressMode::ClampToBorder => vk::SamplerAddressMode::CLAMP_TO_BORDER,
        AddressMode::MirrorClampToEdge => vk::SamplerAddressMode::MIRROR_CLAMP_TO_EDGE,
    }
}

pub fn convert_border_colour(colour: BorderColour) -> vk::BorderColor {
    match colour {
        BorderColour::FloatTransparentBlack => vk::BorderColor::FLOAT_TRANSPARENT_BLACK,
        BorderColour::IntTransparentBlack => vk::BorderColor::INT_TRANSPARENT_BLACK,
        BorderColour::FloatOpaqueBlack => vk::BorderColor::FLOAT_OPAQUE_BLACK,
        BorderColour::IntOpaqueBlack => vk::BorderColor::INT_OPAQUE_BLACK,
        BorderColour::FloatOpaqueWhite => vk::BorderColor::FLOAT_OPAQUE_WHITE,
        BorderColour::IntOpaqueWhite => vk::BorderColor::INT_OPAQUE_WHITE,
    }
}

// ============================================================================
// Render passes
// ============================================================================

pub fn convert_load_op(op: AttachmentLoadOp) -> vk::AttachmentLoadOp {
    match op {
        AttachmentLoadOp::Load => vk::AttachmentLoadOp::LOAD,
        AttachmentLoadOp::Clear => vk::AttachmentLoadOp::CLEAR,
        AttachmentLoadOp::DontCare => vk::AttachmentLoadOp::DONT_CARE,
    }
}

pub fn convert_store_op(op: AttachmentStoreOp) -> vk::AttachmentStoreOp {
    match op {
        AttachmentStoreOp::Store => vk::AttachmentStoreOp::STORE,
        AttachmentStoreOp::DontCare => vk::AttachmentStoreOp::DONT_CARE,
    }
}

pub fn convert_subpass_contents(contents: SubpassContents) -> vk::SubpassContents {
    match contents {
        SubpassContents::Inline => vk::SubpassContents::INLINE,
        SubpassContents::SecondaryCommandBuffers => {
            vk::SubpassContents::SECONDARY_COMMAND_BUFFERS
        }
    }
}

pub fn convert_clear_colour(colour: &ClearColourValue) -> vk::ClearColorValue {
    match *colour {
        ClearColourValue::Float32(float32) => vk::ClearColorValue { float32 },
        ClearColourValue::Int32(int32) => vk::ClearColorValue { int32 },
        ClearColourValue::Uint32(uint32) => vk::ClearColorValue { uint32 },
    }
}

pub fn convert_clear_value(value: &ClearValue) -> vk::ClearValue {
    match value {
        ClearValue::Colour(colour) => vk::ClearValue {
            color: convert_clear_colour(colour),
        },
        ClearValue::DepthStencil(ds) => vk::ClearValue {
            depth_stencil: vk::ClearDepthStencilValue {
                depth: ds.depth,
                stencil: ds.stencil,
            },
        },
    }
}

// ============================================================================
// Geometry
// ============================================================================

pub fn convert_extent_2d(extent: Extent2d) -> vk::Extent2D {
    vk::Extent2D {
        width: extent.width,
        height: extent.height,
    }
}

pub fn convert_extent_3d(extent: Extent3d) -> vk::Extent3D {
    vk::Extent3D {
        width: extent.width,
        height: extent.height,
        depth: extent.depth,
    }
}

pub fn convert_offset_3d(offset: Offset3d) -> vk::Offset3D {
    vk::Offset3D {
        x: offset.x,
        y: offset.y,
        z: offset.z,
    }
}

fn convert_offset_2d(offset: Offset2d) -> vk::Offset2D {
    vk::Offset2D {
        x: offset.x,
        y: offset.y,
    }
}

pub fn convert_rect(rect: &Rect2d) -> vk::Rect2D {
    vk::Rect2D {
        offset: convert_offset_2d(rect.offset),
        extent: convert_extent_2d(rect.extent),
    }
}

pub fn convert_viewport(viewport: &Viewport) -> vk::Viewport {
    vk::Viewport {
        x: viewport.x,
        y: viewport.y,
        width: viewport.width,
        height: viewport.height,
        min_depth: viewport.min_depth,
        max_depth: viewport.max_depth,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_share_vulkan_bits() {
        assert_eq!(
            convert_buffer_usage(BufferUsageFlags::VERTEX | BufferUsageFlags::TRANSFER_DST),
            vk::BufferUsageFlags::VERTEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST
        );
        assert_eq!(
            convert_image_usage(ImageUsageFlags::COLOR_ATTACHMENT),
            vk::ImageUsageFlags::COLOR_ATTACHMENT
        );
        assert_eq!(
            convert_pipeline_stages(PipelineStageFlags::ALL_COMMANDS),
            vk::PipelineStageFlags::ALL_COMMANDS
        );
        assert_eq!(
            convert_access(AccessFlags::MEMORY_WRITE),
            vk::AccessFlags::MEMORY_WRITE
        );
        assert_eq!(
            convert_shader_stages(ShaderStageFlags::ALL_GRAPHICS),
            vk::ShaderStageFlags::ALL_GRAPHICS
        );
        assert_eq!(
            convert_query_result_flags(QueryResultFlags::WITH_AVAILABILITY),
            vk::QueryResultFlags::WITH_AVAILABILITY
        );
    }

    #[test]
    fn test_dynamic_states() {
        let states = convert_dynamic_states(
            DynamicStateFlags::VIEWPORT | DynamicStateFlags::STENCIL_REFERENCE,
        );
        assert_eq!(
            states,
            vec![vk::DynamicState::VIEWPORT, vk::DynamicState::STENCIL_REFERENCE]
        );
        assert!(convert_dynamic_states(DynamicStateFlags::empty()).is_empty());
    }

    #[test]
    fn test_surface_formats_round_trip() {
        for format in [Format::Bgra8Unorm, Format::Rgba8Srgb, Format::Rgba16Float] {
            assert_eq!(format_from_vk(convert_format(format)), Some(format));
        }
        assert_eq!(format_from_vk(vk::Format::D16_UNORM), None);
    }

    #[test]
    fn test_samples() {
        assert_eq!(convert_samples(SampleCount::X1), vk::SampleCountFlags::TYPE_1);
        assert_eq!(convert_samples(SampleCount::X8), vk::SampleCountFlags::TYPE_8);
    }
}
