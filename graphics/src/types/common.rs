//! Common types shared across the graphics system.

use super::{ImageAspectFlags, StencilFaceFlags};

// ============================================================================
// Geometry
// ============================================================================

/// A signed 2D offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Offset2d {
    pub x: i32,
    pub y: i32,
}

/// An unsigned 2D size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent2d {
    pub width: u32,
    pub height: u32,
}

impl Extent2d {
    /// Create a new 2D extent.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A signed 3D offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Offset3d {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

/// An unsigned 3D size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Extent3d {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

impl Extent3d {
    /// Create a new 3D extent.
    pub const fn new(width: u32, height: u32, depth: u32) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    /// Create a 2D extent (depth = 1).
    pub const fn new_2d(width: u32, height: u32) -> Self {
        Self::new(width, height, 1)
    }

    /// Size of the given mip level, never smaller than one texel.
    pub fn mip_level(&self, level: u32) -> Self {
        Self {
            width: (self.width >> level).max(1),
            height: (self.height >> level).max(1),
            depth: (self.depth >> level).max(1),
        }
    }
}

impl Default for Extent3d {
    fn default() -> Self {
        Self::new(1, 1, 1)
    }
}

/// A 2D rectangle, used for scissors and render areas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect2d {
    pub offset: Offset2d,
    pub extent: Extent2d,
}

impl Rect2d {
    /// Create a rectangle from its origin and size.
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            offset: Offset2d { x, y },
            extent: Extent2d { width, height },
        }
    }
}

/// Viewport transform applied after clipping.
///
/// Depth range follows the Vulkan `[0, 1]` convention on every backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Create a new viewport with the standard `[0, 1]` depth range.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }

    /// Set the depth range.
    pub fn with_depth_range(mut self, min_depth: f32, max_depth: f32) -> Self {
        self.min_depth = min_depth;
        self.max_depth = max_depth;
        self
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }
}

// ============================================================================
// Clear values
// ============================================================================

/// Value used to clear a colour attachment or image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearColourValue {
    /// Float / normalized formats.
    Float32([f32; 4]),
    /// Signed integer formats.
    Int32([i32; 4]),
    /// Unsigned integer formats.
    Uint32([u32; 4]),
}

impl Default for ClearColourValue {
    fn default() -> Self {
        Self::Float32([0.0, 0.0, 0.0, 1.0])
    }
}

/// Value used to clear a depth/stencil attachment or image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearDepthStencilValue {
    pub depth: f32,
    pub stencil: u32,
}

impl Default for ClearDepthStencilValue {
    fn default() -> Self {
        Self {
            depth: 1.0,
            stencil: 0,
        }
    }
}

/// Clear value of one render pass attachment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    Colour(ClearColourValue),
    DepthStencil(ClearDepthStencilValue),
}

impl ClearValue {
    /// Float colour clear value.
    pub fn colour(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self::Colour(ClearColourValue::Float32([r, g, b, a]))
    }

    /// Depth/stencil clear value.
    pub fn depth_stencil(depth: f32, stencil: u32) -> Self {
        Self::DepthStencil(ClearDepthStencilValue { depth, stencil })
    }
}

/// One attachment cleared by `ClearAttachments`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearAttachment {
    /// Aspects to clear; `COLOR` selects `colour_attachment`.
    pub aspect_mask: ImageAspectFlags,
    /// Index into the subpass colour attachments.
    pub colour_attachment: u32,
    pub clear_value: ClearValue,
}

/// A region cleared by `ClearAttachments`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ClearRect {
    pub rect: Rect2d,
    pub base_array_layer: u32,
    pub layer_count: u32,
}

// ============================================================================
// Fixed-function enums
// ============================================================================

/// Comparison operator for depth, stencil and sampler compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompareOp {
    Never,
    #[default]
    Less,
    Equal,
    LessOrEqual,
    Greater,
    NotEqual,
    GreaterOrEqual,
    Always,
}

/// Stencil operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StencilOp {
    #[default]
    Keep,
    Zero,
    Replace,
    IncrementAndClamp,
    DecrementAndClamp,
    Invert,
    IncrementAndWrap,
    DecrementAndWrap,
}

/// Blend factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColour,
    OneMinusSrcColour,
    DstColour,
    OneMinusDstColour,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
    ConstantColour,
    OneMinusConstantColour,
    ConstantAlpha,
    OneMinusConstantAlpha,
    SrcAlphaSaturate,
    Src1Colour,
    OneMinusSrc1Colour,
    Src1Alpha,
    OneMinusSrc1Alpha,
}

/// Blend equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendOp {
    #[default]
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

/// Framebuffer logic operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LogicOp {
    Clear,
    And,
    AndReverse,
    #[default]
    Copy,
    AndInverted,
    NoOp,
    Xor,
    Or,
    Nor,
    Equivalent,
    Invert,
    OrReverse,
    CopyInverted,
    OrInverted,
    Nand,
    Set,
}

/// Polygon rasterisation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PolygonMode {
    #[default]
    Fill,
    Line,
    Point,
}

/// Winding order of front-facing triangles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FrontFace {
    #[default]
    CounterClockwise,
    Clockwise,
}

/// Primitive topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    LineStrip,
    #[default]
    TriangleList,
    TriangleStrip,
    TriangleFan,
    LineListWithAdjacency,
    LineStripWithAdjacency,
    TriangleListWithAdjacency,
    TriangleStripWithAdjacency,
    PatchList,
}

/// Type of the elements of an index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndexType {
    Uint16,
    #[default]
    Uint32,
}

impl IndexType {
    /// Size of one index in bytes.
    pub fn size(&self) -> u64 {
        match self {
            Self::Uint16 => 2,
            Self::Uint32 => 4,
        }
    }
}

/// Bind point of pipelines and descriptor sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PipelineBindPoint {
    #[default]
    Graphics,
    Compute,
}

/// Kind of query stored in a query pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QueryType {
    #[default]
    Occlusion,
    PipelineStatistics,
    Timestamp,
}

/// Descriptor for creating a query pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct QueryPoolDescriptor {
    pub label: Option<String>,
    pub query_type: QueryType,
    pub query_count: u32,
}

impl QueryPoolDescriptor {
    /// Create a new query pool descriptor.
    pub fn new(query_type: QueryType, query_count: u32) -> Self {
        Self {
            label: None,
            query_type,
            query_count,
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Outcome of a fence wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WaitResult {
    Success,
    TimeOut,
}

/// Helper used by the dynamic stencil commands.
pub(crate) fn stencil_faces(face: StencilFaceFlags) -> (bool, bool) {
    (
        face.contains(StencilFaceFlags::FRONT),
        face.contains(StencilFaceFlags::BACK),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extent_mip_level() {
        let extent = Extent3d::new_2d(256, 64);
        assert_eq!(extent.mip_level(2), Extent3d::new(64, 16, 1));
        assert_eq!(extent.mip_level(10), Extent3d::new(1, 1, 1));
    }

    #[test]
    fn test_viewport_default_depth_range() {
        let viewport = Viewport::new(0.0, 0.0, 800.0, 600.0);
        assert_eq!(viewport.min_depth, 0.0);
        assert_eq!(viewport.max_depth, 1.0);
        let viewport = viewport.with_depth_range(0.25, 0.5);
        assert_eq!(viewport.max_depth, 0.5);
    }

    #[test]
    fn test_stencil_faces() {
        assert_eq!(stencil_faces(StencilFaceFlags::FRONT), (true, false));
        assert_eq!(stencil_faces(StencilFaceFlags::FRONT_AND_BACK), (true, true));
    }
}
