//! Conversions from abstract enums and flags to GL enumerants.
//!
//! Every function is total over its input type. Values GL cannot express
//! panic; none silently fall back to a default.

use super::constants::*;
use crate::types::{
    AccessFlags, AddressMode, BlendFactor, BlendOp, CompareOp, ComponentSwizzle, CullModeFlags,
    Filter, Format, FrontFace, ImageAspectFlags, IndexType, LogicOp, MemoryPropertyFlags,
    MipmapMode, PipelineStageFlags, PolygonMode, PrimitiveTopology, QueryType, ShaderStageFlags,
    StencilFaceFlags, StencilOp,
};

/// Texture storage description of a [`Format`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlFormat {
    /// Sized internal format.
    pub internal: GLenum,
    /// Client pixel format.
    pub format: GLenum,
    /// Client pixel type.
    pub ty: GLenum,
}

/// Vertex attribute description of a [`Format`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlVertexFormat {
    pub size: GLint,
    pub ty: GLenum,
    pub normalized: bool,
    /// Read through `glVertexAttribIPointer`.
    pub integer: bool,
}

pub fn convert_format(format: Format) -> GlFormat {
    let (internal, client, ty) = match format {
        Format::R8Unorm => (GL_R8, GL_RED, GL_UNSIGNED_BYTE),
        Format::R8Snorm => (GL_R8_SNORM, GL_RED, GL_BYTE),
        Format::R8Uint => (GL_R8UI, GL_RED_INTEGER, GL_UNSIGNED_BYTE),
        Format::R8Sint => (GL_R8I, GL_RED_INTEGER, GL_BYTE),
        Format::Rg8Unorm => (GL_RG8, GL_RG, GL_UNSIGNED_BYTE),
        Format::Rgba8Unorm => (GL_RGBA8, GL_RGBA, GL_UNSIGNED_BYTE),
        Format::Rgba8Snorm => (GL_RGBA8_SNORM, GL_RGBA, GL_BYTE),
        Format::Rgba8Srgb => (GL_SRGB8_ALPHA8, GL_RGBA, GL_UNSIGNED_BYTE),
        Format::Rgba8Uint => (GL_RGBA8UI, GL_RGBA_INTEGER, GL_UNSIGNED_BYTE),
        Format::Bgra8Unorm => (GL_RGBA8, GL_BGRA, GL_UNSIGNED_BYTE),
        Format::Bgra8Srgb => (GL_SRGB8_ALPHA8, GL_BGRA, GL_UNSIGNED_BYTE),
        Format::R16Float => (GL_R16F, GL_RED, GL_HALF_FLOAT),
        Format::R16Uint => (GL_R16UI, GL_RED_INTEGER, GL_UNSIGNED_SHORT),
        Format::Rg16Float => (GL_RG16F, GL_RG, GL_HALF_FLOAT),
        Format::Rgba16Float => (GL_RGBA16F, GL_RGBA, GL_HALF_FLOAT),
        Format::R32Float => (GL_R32F, GL_RED, GL_FLOAT),
        Format::R32Uint => (GL_R32UI, GL_RED_INTEGER, GL_UNSIGNED_INT),
        Format::R32Sint => (GL_R32I, GL_RED_INTEGER, GL_INT),
        Format::Rg32Float => (GL_RG32F, GL_RG, GL_FLOAT),
        Format::Rg32Uint => (GL_RG32UI, GL_RG_INTEGER, GL_UNSIGNED_INT),
        Format::Rg32Sint => (GL_RG32I, GL_RG_INTEGER, GL_INT),
        Format::Rgb32Float => (GL_RGB32F, GL_RGB, GL_FLOAT),
        Format::Rgba32Float => (GL_RGBA32F, GL_RGBA, GL_FLOAT),
        Format::Rgba32Uint => (GL_RGBA32UI, GL_RGBA_INTEGER, GL_UNSIGNED_INT),
        Format::Rgba32Sint => (GL_RGBA32I, GL_RGBA_INTEGER, GL_INT),
        Format::A2b10g10r10Unorm => (GL_RGB10_A2, GL_RGBA, GL_UNSIGNED_INT_2_10_10_10_REV),
        Format::B10g11r11Ufloat => (GL_R11F_G11F_B10F, GL_RGB, GL_UNSIGNED_INT_10F_11F_11F_REV),
        Format::D16Unorm => (GL_DEPTH_COMPONENT16, GL_DEPTH_COMPONENT, GL_UNSIGNED_SHORT),
        Format::X8D24Unorm => (GL_DEPTH_COMPONENT24, GL_DEPTH_COMPONENT, GL_UNSIGNED_INT),
        Format::D32Float => (GL_DEPTH_COMPONENT32F, GL_DEPTH_COMPONENT, GL_FLOAT),
        Format::S8Uint => (GL_STENCIL_INDEX8, GL_STENCIL_INDEX, GL_UNSIGNED_BYTE),
        Format::D24UnormS8Uint => (GL_DEPTH24_STENCIL8, GL_DEPTH_STENCIL, GL_UNSIGNED_INT_24_8),
        Format::D32FloatS8Uint => (
            GL_DEPTH32F_STENCIL8,
            GL_DEPTH_STENCIL,
            GL_FLOAT_32_UNSIGNED_INT_24_8_REV,
        ),
    };
    GlFormat {
        internal,
        format: client,
        ty,
    }
}

pub fn convert_vertex_format(format: Format) -> GlVertexFormat {
    let (ty, normalized, integer) = match format {
        Format::R8Unorm | Format::Rg8Unorm | Format::Rgba8Unorm => (GL_UNSIGNED_BYTE, true, false),
        Format::R8Snorm | Format::Rgba8Snorm => (GL_BYTE, true, false),
        Format::R8Uint | Format::Rgba8Uint => (GL_UNSIGNED_BYTE, false, true),
        Format::R8Sint => (GL_BYTE, false, true),
        Format::R16Float | Format::Rg16Float | Format::Rgba16Float => (GL_HALF_FLOAT, false, false),
        Format::R16Uint => (GL_UNSIGNED_SHORT, false, true),
        Format::R32Float | Format::Rg32Float | Format::Rgb32Float | Format::Rgba32Float => {
            (GL_FLOAT, false, false)
        }
        Format::R32Uint | Format::Rg32Uint | Format::Rgba32Uint => (GL_UNSIGNED_INT, false, true),
        Format::R32Sint | Format::Rg32Sint | Format::Rgba32Sint => (GL_INT, false, true),
        Format::A2b10g10r10Unorm => (GL_UNSIGNED_INT_2_10_10_10_REV, true, false),
        Format::Rgba8Srgb
        | Format::Bgra8Unorm
        | Format::Bgra8Srgb
        | Format::B10g11r11Ufloat
        | Format::D16Unorm
        | Format::X8D24Unorm
        | Format::D32Float
        | Format::S8Uint
        | Format::D24UnormS8Uint
        | Format::D32FloatS8Uint => {
            panic!("vertex attribute format {format:?} is unsupported on this backend")
        }
    };
    GlVertexFormat {
        size: format.component_count() as GLint,
        ty,
        normalized,
        integer,
    }
}

pub fn convert_compare_op(op: CompareOp) -> GLenum {
    match op {
        CompareOp::Never => GL_NEVER,
        CompareOp::Less => GL_LESS,
        CompareOp::Equal => GL_EQUAL,
        CompareOp::LessOrEqual => GL_LEQUAL,
        CompareOp::Greater => GL_GREATER,
        CompareOp::NotEqual => GL_NOTEQUAL,
        CompareOp::GreaterOrEqual => GL_GEQUAL,
        CompareOp::Always => GL_ALWAYS,
    }
}

pub fn convert_stencil_op(op: StencilOp) -> GLenum {
    match op {
        StencilOp::Keep => GL_KEEP,
        StencilOp::Zero => GL_ZERO,
        StencilOp::Replace => GL_REPLACE,
        StencilOp::IncrementAndClamp => GL_INCR,
        StencilOp::DecrementAndClamp => GL_DECR,
        StencilOp::Invert => GL_INVERT,
        StencilOp::IncrementAndWrap => GL_INCR_WRAP,
        StencilOp::DecrementAndWrap => GL_DECR_WRAP,
    }
}

pub fn convert_blend_factor(factor: BlendFactor) -> GLenum {
    match factor {
        BlendFactor::Zero => GL_ZERO,
        BlendFactor::One => GL_ONE,
        BlendFactor::SrcColour => GL_SRC_COLOR,
        BlendFactor::OneMinusSrcColour => GL_ONE_MINUS_SRC_COLOR,
        BlendFactor::DstColour => GL_DST_COLOR,
        BlendFactor::OneMinusDstColour => GL_ONE_MINUS_DST_COLOR,
        BlendFactor::SrcAlpha => GL_SRC_ALPHA,
        BlendFactor::OneMinusSrcAlpha => GL_ONE_MINUS_SRC_ALPHA,
        BlendFactor::DstAlpha => GL_DST_ALPHA,
        BlendFactor::OneMinusDstAlpha => GL_ONE_MINUS_DST_ALPHA,
        BlendFactor::ConstantColour => GL_CONSTANT_COLOR,
        BlendFactor::OneMinusConstantColour => GL_ONE_MINUS_CONSTANT_COLOR,
        BlendFactor::ConstantAlpha => GL_CONSTANT_ALPHA,
        BlendFactor::OneMinusConstantAlpha => GL_ONE_MINUS_CONSTANT_ALPHA,
        BlendFactor::SrcAlphaSaturate => GL_SRC_ALPHA_SATURATE,
        BlendFactor::Src1Colour => GL_SRC1_COLOR,
        BlendFactor::OneMinusSrc1Colour => GL_ONE_MINUS_SRC1_COLOR,
        BlendFactor::Src1Alpha => GL_SRC1_ALPHA,
        BlendFactor::OneMinusSrc1Alpha => GL_ONE_MINUS_SRC1_ALPHA,
    }
}

pub fn convert_blend_op(op: BlendOp) -> GLenum {
    match op {
        BlendOp::Add => GL_FUNC_ADD,
        BlendOp::Subtract => GL_FUNC_SUBTRACT,
        BlendOp::ReverseSubtract => GL_FUNC_REVERSE_SUBTRACT,
        BlendOp::Min => GL_MIN,
        BlendOp::Max => GL_MAX,
    }
}

pub fn convert_logic_op(op: LogicOp) -> GLenum {
    match op {
        LogicOp::Clear => GL_CLEAR,
        LogicOp::And => GL_AND,
        LogicOp::AndReverse => GL_AND_REVERSE,
        LogicOp::Copy => GL_COPY,
        LogicOp::AndInverted => GL_AND_INVERTED,
        LogicOp::NoOp => GL_NOOP,
        LogicOp::Xor => GL_XOR,
        LogicOp::Or => GL_OR,
        LogicOp::Nor => GL_NOR,
        LogicOp::Equivalent => GL_EQUIV,
        LogicOp::Invert => GL_INVERT,
        LogicOp::OrReverse => GL_OR_REVERSE,
        LogicOp::CopyInverted => GL_COPY_INVERTED,
        LogicOp::OrInverted => GL_OR_INVERTED,
        LogicOp::Nand => GL_NAND,
        LogicOp::Set => GL_SET,
    }
}

pub fn convert_polygon_mode(mode: PolygonMode) -> GLenum {
    match mode {
        PolygonMode::Fill => GL_FILL,
        PolygonMode::Line => GL_LINE,
        PolygonMode::Point => GL_POINT,
    }
}

pub fn convert_front_face(face: FrontFace) -> GLenum {
    match face {
        FrontFace::CounterClockwise => GL_CCW,
        FrontFace::Clockwise => GL_CW,
    }
}

/// Face passed to `glCullFace`; `None` means culling is disabled.
pub fn convert_cull_mode(mode: CullModeFlags) -> Option<GLenum> {
    match (
        mode.contains(CullModeFlags::FRONT),
        mode.contains(CullModeFlags::BACK),
    ) {
        (false, false) => None,
        (true, false) => Some(GL_FRONT),
        (false, true) => Some(GL_BACK),
        (true, true) => Some(GL_FRONT_AND_BACK),
    }
}

pub fn convert_stencil_face(face: StencilFaceFlags) -> GLenum {
    match (
        face.contains(StencilFaceFlags::FRONT),
        face.contains(StencilFaceFlags::BACK),
    ) {
        (true, false) => GL_FRONT,
        (false, true) => GL_BACK,
        (true, true) => GL_FRONT_AND_BACK,
        (false, false) => panic!("empty stencil face mask"),
    }
}

pub fn convert_topology(topology: PrimitiveTopology) -> GLenum {
    match topology {
        PrimitiveTopology::PointList => GL_POINTS,
        PrimitiveTopology::LineList => GL_LINES,
        PrimitiveTopology::LineStrip => GL_LINE_STRIP,
        PrimitiveTopology::TriangleList => GL_TRIANGLES,
        PrimitiveTopology::TriangleStrip => GL_TRIANGLE_STRIP,
        PrimitiveTopology::TriangleFan => GL_TRIANGLE_FAN,
        PrimitiveTopology::LineListWithAdjacency => GL_LINES_ADJACENCY,
        PrimitiveTopology::LineStripWithAdjacency => GL_LINE_STRIP_ADJACENCY,
        PrimitiveTopology::TriangleListWithAdjacency => GL_TRIANGLES_ADJACENCY,
        PrimitiveTopology::TriangleStripWithAdjacency => GL_TRIANGLE_STRIP_ADJACENCY,
        PrimitiveTopology::PatchList => GL_PATCHES,
    }
}

pub fn convert_index_type(ty: IndexType) -> GLenum {
    match ty {
        IndexType::Uint16 => GL_UNSIGNED_SHORT,
        IndexType::Uint32 => GL_UNSIGNED_INT,
    }
}

pub fn convert_mag_filter(filter: Filter) -> GLenum {
    match filter {
        Filter::Nearest => GL_NEAREST,
        Filter::Linear => GL_LINEAR,
    }
}

pub fn convert_min_filter(filter: Filter, mipmap: MipmapMode) -> GLenum {
    match (filter, mipmap) {
        (Filter::Nearest, MipmapMode::Nearest) => GL_NEAREST_MIPMAP_NEAREST,
        (Filter::Nearest, MipmapMode::Linear) => GL_NEAREST_MIPMAP_LINEAR,
        (Filter::Linear, MipmapMode::Nearest) => GL_LINEAR_MIPMAP_NEAREST,
        (Filter::Linear, MipmapMode::Linear) => GL_LINEAR_MIPMAP_LINEAR,
    }
}

pub fn convert_address_mode(mode: AddressMode) -> GLenum {
    match mode {
        AddressMode::Repeat => GL_REPEAT,
        AddressMode::MirroredRepeat => GL_MIRRORED_REPEAT,
        AddressMode::ClampToEdge => GL_CLAMP_TO_EDGE,
        AddressMode::ClampToBorder => GL_CLAMP_TO_BORDER,
        AddressMode::MirrorClampToEdge => GL_MIRROR_CLAMP_TO_EDGE,
    }
}

/// Swizzle source of one component; `own` is the identity channel.
pub fn convert_swizzle(swizzle: ComponentSwizzle, own: GLenum) -> GLenum {
    match swizzle {
        ComponentSwizzle::Identity => own,
        ComponentSwizzle::Zero => GL_ZERO,
        ComponentSwizzle::One => GL_ONE,
        ComponentSwizzle::R => GL_RED,
        ComponentSwizzle::G => GL_GREEN,
        ComponentSwizzle::B => GL_BLUE,
        ComponentSwizzle::A => GL_ALPHA,
    }
}

pub fn convert_query_type(ty: QueryType) -> GLenum {
    match ty {
        QueryType::Occlusion => GL_SAMPLES_PASSED,
        QueryType::PipelineStatistics => GL_PRIMITIVES_GENERATED,
        QueryType::Timestamp => GL_TIMESTAMP,
    }
}

/// Shader object kind of a single stage bit.
pub fn convert_shader_stage(stage: ShaderStageFlags) -> GLenum {
    if stage == ShaderStageFlags::VERTEX {
        GL_VERTEX_SHADER
    } else if stage == ShaderStageFlags::TESSELLATION_CONTROL {
        GL_TESS_CONTROL_SHADER
    } else if stage == ShaderStageFlags::TESSELLATION_EVALUATION {
        GL_TESS_EVALUATION_SHADER
    } else if stage == ShaderStageFlags::GEOMETRY {
        GL_GEOMETRY_SHADER
    } else if stage == ShaderStageFlags::FRAGMENT {
        GL_FRAGMENT_SHADER
    } else if stage == ShaderStageFlags::COMPUTE {
        GL_COMPUTE_SHADER
    } else {
        panic!("shader stage {stage:?} is unsupported on this backend")
    }
}

/// Usage hint passed to `glBufferData`.
pub fn convert_memory_flags(flags: MemoryPropertyFlags) -> GLenum {
    if flags.contains(MemoryPropertyFlags::HOST_VISIBLE | MemoryPropertyFlags::HOST_CACHED) {
        GL_DYNAMIC_READ
    } else if flags.contains(MemoryPropertyFlags::HOST_VISIBLE) {
        GL_DYNAMIC_DRAW
    } else {
        GL_STATIC_DRAW
    }
}

/// Framebuffer attachment point of a depth/stencil format.
pub fn depth_stencil_attachment_point(format: Format) -> GLenum {
    match (format.is_depth(), format.has_stencil()) {
        (true, true) => GL_DEPTH_STENCIL_ATTACHMENT,
        (true, false) => GL_DEPTH_ATTACHMENT,
        (false, true) => GL_STENCIL_ATTACHMENT,
        (false, false) => panic!("{format:?} is not a depth/stencil format"),
    }
}

/// Mask passed to `glBlitFramebuffer` for the given aspects.
pub fn convert_aspect_mask(aspects: ImageAspectFlags) -> GLbitfield {
    let mut mask = 0;
    if aspects.contains(ImageAspectFlags::COLOR) {
        mask |= GL_COLOR_BUFFER_BIT;
    }
    if aspects.contains(ImageAspectFlags::DEPTH) {
        mask |= GL_DEPTH_BUFFER_BIT;
    }
    if aspects.contains(ImageAspectFlags::STENCIL) {
        mask |= GL_STENCIL_BUFFER_BIT;
    }
    mask
}

/// `glMemoryBarrier` bits making memory visible to the given accesses.
pub fn convert_access_flags(access: AccessFlags) -> GLbitfield {
    if access.intersects(AccessFlags::MEMORY_READ | AccessFlags::MEMORY_WRITE) {
        return GL_ALL_BARRIER_BITS;
    }
    let mut bits = 0;
    if access.contains(AccessFlags::INDIRECT_COMMAND_READ) {
        bits |= GL_COMMAND_BARRIER_BIT;
    }
    if access.contains(AccessFlags::INDEX_READ) {
        bits |= GL_ELEMENT_ARRAY_BARRIER_BIT;
    }
    if access.contains(AccessFlags::VERTEX_ATTRIBUTE_READ) {
        bits |= GL_VERTEX_ATTRIB_ARRAY_BARRIER_BIT;
    }
    if access.contains(AccessFlags::UNIFORM_READ) {
        bits |= GL_UNIFORM_BARRIER_BIT;
    }
    if access.contains(AccessFlags::SHADER_READ) {
        bits |= GL_TEXTURE_FETCH_BARRIER_BIT
            | GL_SHADER_IMAGE_ACCESS_BARRIER_BIT
            | GL_SHADER_STORAGE_BARRIER_BIT;
    }
    if access.contains(AccessFlags::SHADER_WRITE) {
        bits |= GL_SHADER_IMAGE_ACCESS_BARRIER_BIT | GL_SHADER_STORAGE_BARRIER_BIT;
    }
    if access.intersects(
        AccessFlags::INPUT_ATTACHMENT_READ
            | AccessFlags::COLOR_ATTACHMENT_READ
            | AccessFlags::COLOR_ATTACHMENT_WRITE
            | AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ
            | AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
    ) {
        bits |= GL_FRAMEBUFFER_BARRIER_BIT;
    }
    if access.intersects(AccessFlags::TRANSFER_READ | AccessFlags::TRANSFER_WRITE) {
        bits |= GL_BUFFER_UPDATE_BARRIER_BIT
            | GL_TEXTURE_UPDATE_BARRIER_BIT
            | GL_PIXEL_BUFFER_BARRIER_BIT;
    }
    if access.intersects(AccessFlags::HOST_READ | AccessFlags::HOST_WRITE) {
        bits |= GL_CLIENT_MAPPED_BUFFER_BARRIER_BIT;
    }
    bits
}

/// `glMemoryBarrier` bits covering every access the given stages can do.
pub fn convert_stage_flags(stages: PipelineStageFlags) -> GLbitfield {
    if stages.intersects(PipelineStageFlags::ALL_GRAPHICS | PipelineStageFlags::ALL_COMMANDS) {
        return GL_ALL_BARRIER_BITS;
    }
    let mut bits = 0;
    if stages.contains(PipelineStageFlags::DRAW_INDIRECT) {
        bits |= GL_COMMAND_BARRIER_BIT;
    }
    if stages.contains(PipelineStageFlags::VERTEX_INPUT) {
        bits |= GL_VERTEX_ATTRIB_ARRAY_BARRIER_BIT | GL_ELEMENT_ARRAY_BARRIER_BIT;
    }
    if stages.intersects(
        PipelineStageFlags::VERTEX_SHADER
            | PipelineStageFlags::TESSELLATION_CONTROL_SHADER
            | PipelineStageFlags::TESSELLATION_EVALUATION_SHADER
            | PipelineStageFlags::GEOMETRY_SHADER
            | PipelineStageFlags::FRAGMENT_SHADER
            | PipelineStageFlags::COMPUTE_SHADER,
    ) {
        bits |= GL_UNIFORM_BARRIER_BIT
            | GL_TEXTURE_FETCH_BARRIER_BIT
            | GL_SHADER_IMAGE_ACCESS_BARRIER_BIT
            | GL_SHADER_STORAGE_BARRIER_BIT;
    }
    if stages.intersects(
        PipelineStageFlags::EARLY_FRAGMENT_TESTS
            | PipelineStageFlags::LATE_FRAGMENT_TESTS
            | PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
    ) {
        bits |= GL_FRAMEBUFFER_BARRIER_BIT;
    }
    if stages.contains(PipelineStageFlags::TRANSFER) {
        bits |= GL_BUFFER_UPDATE_BARRIER_BIT
            | GL_TEXTURE_UPDATE_BARRIER_BIT
            | GL_PIXEL_BUFFER_BARRIER_BIT;
    }
    if stages.contains(PipelineStageFlags::HOST) {
        bits |= GL_CLIENT_MAPPED_BUFFER_BARRIER_BIT;
    }
    bits
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_FORMATS: [Format; 33] = [
        Format::R8Unorm,
        Format::R8Snorm,
        Format::R8Uint,
        Format::R8Sint,
        Format::Rg8Unorm,
        Format::Rgba8Unorm,
        Format::Rgba8Snorm,
        Format::Rgba8Srgb,
        Format::Rgba8Uint,
        Format::Bgra8Unorm,
        Format::Bgra8Srgb,
        Format::R16Float,
        Format::R16Uint,
        Format::Rg16Float,
        Format::Rgba16Float,
        Format::R32Float,
        Format::R32Uint,
        Format::R32Sint,
        Format::Rg32Float,
        Format::Rg32Uint,
        Format::Rg32Sint,
        Format::Rgb32Float,
        Format::Rgba32Float,
        Format::Rgba32Uint,
        Format::Rgba32Sint,
        Format::A2b10g10r10Unorm,
        Format::B10g11r11Ufloat,
        Format::D16Unorm,
        Format::X8D24Unorm,
        Format::D32Float,
        Format::S8Uint,
        Format::D24UnormS8Uint,
        Format::D32FloatS8Uint,
    ];

    #[test]
    fn test_every_format_has_a_texture_format() {
        for format in ALL_FORMATS {
            let gl = convert_format(format);
            assert_ne!(gl.internal, 0, "{format:?}");
            assert_ne!(gl.format, 0, "{format:?}");
            if format.is_integer() {
                assert!(
                    matches!(
                        gl.format,
                        GL_RED_INTEGER | GL_RG_INTEGER | GL_RGB_INTEGER | GL_RGBA_INTEGER
                    ),
                    "{format:?}"
                );
            }
        }
    }

    #[test]
    fn test_vertex_formats() {
        let position = convert_vertex_format(Format::Rgb32Float);
        assert_eq!(position.size, 3);
        assert_eq!(position.ty, GL_FLOAT);
        assert!(!position.integer);

        let colour = convert_vertex_format(Format::Rgba8Unorm);
        assert!(colour.normalized);

        let joints = convert_vertex_format(Format::Rgba32Uint);
        assert!(joints.integer);
    }

    #[test]
    #[should_panic(expected = "unsupported on this backend")]
    fn test_depth_vertex_format_panics() {
        convert_vertex_format(Format::D32Float);
    }

    #[test]
    #[should_panic(expected = "unsupported on this backend")]
    fn test_combined_shader_stage_panics() {
        convert_shader_stage(ShaderStageFlags::VERTEX | ShaderStageFlags::FRAGMENT);
    }

    #[test]
    fn test_cull_mode() {
        assert_eq!(convert_cull_mode(CullModeFlags::empty()), None);
        assert_eq!(convert_cull_mode(CullModeFlags::BACK), Some(GL_BACK));
        assert_eq!(
            convert_cull_mode(CullModeFlags::FRONT_AND_BACK),
            Some(GL_FRONT_AND_BACK)
        );
    }

    #[test]
    fn test_access_flags_to_barrier_bits() {
        assert_eq!(
            convert_access_flags(AccessFlags::INDIRECT_COMMAND_READ),
            GL_COMMAND_BARRIER_BIT
        );
        assert_eq!(
            convert_access_flags(AccessFlags::MEMORY_WRITE),
            GL_ALL_BARRIER_BITS
        );
        assert_eq!(convert_access_flags(AccessFlags::empty()), 0);
        let bits = convert_access_flags(AccessFlags::SHADER_WRITE);
        assert_ne!(bits & GL_SHADER_STORAGE_BARRIER_BIT, 0);
    }

    #[test]
    fn test_stage_flags_to_barrier_bits() {
        assert_eq!(convert_stage_flags(PipelineStageFlags::TOP_OF_PIPE), 0);
        assert_eq!(
            convert_stage_flags(PipelineStageFlags::ALL_COMMANDS),
            GL_ALL_BARRIER_BITS
        );
        assert_ne!(
            convert_stage_flags(PipelineStageFlags::VERTEX_INPUT) & GL_ELEMENT_ARRAY_BARRIER_BIT,
            0
        );
    }

    #[test]
    fn test_min_filter() {
        assert_eq!(
            convert_min_filter(Filter::Linear, MipmapMode::Linear),
            GL_LINEAR_MIPMAP_LINEAR
        );
        assert_eq!(
            convert_min_filter(Filter::Nearest, MipmapMode::Linear),
            GL_NEAREST_MIPMAP_LINEAR
        );
    }

    #[test]
    fn test_query_targets() {
        assert_eq!(convert_query_type(QueryType::Occlusion), GL_SAMPLES_PASSED);
        assert_eq!(convert_query_type(QueryType::Timestamp), GL_TIMESTAMP);
    }
}
