//! Pixel and vertex attribute formats.

use super::ImageAspectFlags;

/// Format of image texels and vertex attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Format {
    // 8-bit channels
    /// 8-bit red channel, unsigned normalized.
    R8Unorm,
    /// 8-bit red channel, signed normalized.
    R8Snorm,
    /// 8-bit red channel, unsigned integer.
    R8Uint,
    /// 8-bit red channel, signed integer.
    R8Sint,
    /// 8-bit RG channels, unsigned normalized.
    Rg8Unorm,
    /// 8-bit RGBA channels, unsigned normalized.
    #[default]
    Rgba8Unorm,
    /// 8-bit RGBA channels, signed normalized.
    Rgba8Snorm,
    /// 8-bit RGBA channels, sRGB.
    Rgba8Srgb,
    /// 8-bit RGBA channels, unsigned integer.
    Rgba8Uint,
    /// 8-bit BGRA channels, unsigned normalized.
    Bgra8Unorm,
    /// 8-bit BGRA channels, sRGB.
    Bgra8Srgb,

    // 16-bit channels
    /// 16-bit red channel, float.
    R16Float,
    /// 16-bit red channel, unsigned integer.
    R16Uint,
    /// 16-bit RG channels, float.
    Rg16Float,
    /// 16-bit RGBA channels, float.
    Rgba16Float,

    // 32-bit channels
    /// 32-bit red channel, float.
    R32Float,
    /// 32-bit red channel, unsigned integer.
    R32Uint,
    /// 32-bit red channel, signed integer.
    R32Sint,
    /// 32-bit RG channels, float.
    Rg32Float,
    /// 32-bit RG channels, unsigned integer.
    Rg32Uint,
    /// 32-bit RG channels, signed integer.
    Rg32Sint,
    /// 32-bit RGB channels, float.
    Rgb32Float,
    /// 32-bit RGBA channels, float.
    Rgba32Float,
    /// 32-bit RGBA channels, unsigned integer.
    Rgba32Uint,
    /// 32-bit RGBA channels, signed integer.
    Rgba32Sint,

    // Packed
    /// 10-bit RGB with 2-bit alpha, unsigned normalized.
    A2b10g10r10Unorm,
    /// Packed unsigned float 11/11/10.
    B10g11r11Ufloat,

    // Depth / stencil
    /// 16-bit depth.
    D16Unorm,
    /// 24-bit depth in a 32-bit word.
    X8D24Unorm,
    /// 32-bit float depth.
    D32Float,
    /// 8-bit stencil.
    S8Uint,
    /// 24-bit depth with 8-bit stencil.
    D24UnormS8Uint,
    /// 32-bit float depth with 8-bit stencil.
    D32FloatS8Uint,
}

impl Format {
    /// Returns true if this format has a depth component.
    pub fn is_depth(&self) -> bool {
        matches!(
            self,
            Self::D16Unorm
                | Self::X8D24Unorm
                | Self::D32Float
                | Self::D24UnormS8Uint
                | Self::D32FloatS8Uint
        )
    }

    /// Returns true if this format has a stencil component.
    pub fn has_stencil(&self) -> bool {
        matches!(
            self,
            Self::S8Uint | Self::D24UnormS8Uint | Self::D32FloatS8Uint
        )
    }

    /// Returns true if this is a depth and/or stencil format.
    pub fn is_depth_or_stencil(&self) -> bool {
        self.is_depth() || self.has_stencil()
    }

    /// Returns true if the colour channels are read as integers.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Self::R8Uint
                | Self::R8Sint
                | Self::Rgba8Uint
                | Self::R16Uint
                | Self::R32Uint
                | Self::R32Sint
                | Self::Rg32Uint
                | Self::Rg32Sint
                | Self::Rgba32Uint
                | Self::Rgba32Sint
        )
    }

    /// Returns true if the colour channels are signed integers.
    pub fn is_signed_integer(&self) -> bool {
        matches!(
            self,
            Self::R8Sint | Self::R32Sint | Self::Rg32Sint | Self::Rgba32Sint
        )
    }

    /// Number of components of the format.
    pub fn component_count(&self) -> u32 {
        match self {
            Self::R8Unorm
            | Self::R8Snorm
            | Self::R8Uint
            | Self::R8Sint
            | Self::R16Float
            | Self::R16Uint
            | Self::R32Float
            | Self::R32Uint
            | Self::R32Sint
            | Self::D16Unorm
            | Self::X8D24Unorm
            | Self::D32Float
            | Self::S8Uint => 1,
            Self::Rg8Unorm
            | Self::Rg16Float
            | Self::Rg32Float
            | Self::Rg32Uint
            | Self::Rg32Sint
            | Self::D24UnormS8Uint
            | Self::D32FloatS8Uint => 2,
            Self::Rgb32Float | Self::B10g11r11Ufloat => 3,
            Self::Rgba8Unorm
            | Self::Rgba8Snorm
            | Self::Rgba8Srgb
            | Self::Rgba8Uint
            | Self::Bgra8Unorm
            | Self::Bgra8Srgb
            | Self::Rgba16Float
            | Self::Rgba32Float
            | Self::Rgba32Uint
            | Self::Rgba32Sint
            | Self::A2b10g10r10Unorm => 4,
        }
    }

    /// Returns the size in bytes of one texel (or one vertex attribute).
    pub fn block_size(&self) -> u32 {
        match self {
            Self::R8Unorm | Self::R8Snorm | Self::R8Uint | Self::R8Sint | Self::S8Uint => 1,
            Self::Rg8Unorm | Self::R16Float | Self::R16Uint | Self::D16Unorm => 2,
            Self::Rgba8Unorm
            | Self::Rgba8Snorm
            | Self::Rgba8Srgb
            | Self::Rgba8Uint
            | Self::Bgra8Unorm
            | Self::Bgra8Srgb
            | Self::Rg16Float
            | Self::R32Float
            | Self::R32Uint
            | Self::R32Sint
            | Self::A2b10g10r10Unorm
            | Self::B10g11r11Ufloat
            | Self::X8D24Unorm
            | Self::D32Float
            | Self::D24UnormS8Uint => 4,
            Self::Rgba16Float | Self::Rg32Float | Self::Rg32Uint | Self::Rg32Sint => 8,
            Self::D32FloatS8Uint => 8,
            Self::Rgb32Float => 12,
            Self::Rgba32Float | Self::Rgba32Uint | Self::Rgba32Sint => 16,
        }
    }

    /// The image aspects carried by this format.
    pub fn aspects(&self) -> ImageAspectFlags {
        match (self.is_depth(), self.has_stencil()) {
            (true, true) => ImageAspectFlags::DEPTH | ImageAspectFlags::STENCIL,
            (true, false) => ImageAspectFlags::DEPTH,
            (false, true) => ImageAspectFlags::STENCIL,
            (false, false) => ImageAspectFlags::COLOR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_stencil_classification() {
        assert!(Format::D24UnormS8Uint.is_depth());
        assert!(Format::D24UnormS8Uint.has_stencil());
        assert!(!Format::D32Float.has_stencil());
        assert!(Format::S8Uint.is_depth_or_stencil());
        assert!(!Format::Rgba8Unorm.is_depth_or_stencil());
    }

    #[test]
    fn test_aspects() {
        assert_eq!(Format::Rgba8Unorm.aspects(), ImageAspectFlags::COLOR);
        assert_eq!(
            Format::D32FloatS8Uint.aspects(),
            ImageAspectFlags::DEPTH | ImageAspectFlags::STENCIL
        );
    }

    #[test]
    fn test_block_size() {
        assert_eq!(Format::Rgba8Unorm.block_size(), 4);
        assert_eq!(Format::Rgb32Float.block_size(), 12);
        assert_eq!(Format::Rgba32Float.block_size(), 16);
        assert_eq!(Format::Rgb32Float.component_count(), 3);
    }
}
