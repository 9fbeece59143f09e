// Copyright 2025
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Pixel format enumeration and descriptors.
//!
//! Formats carry the same names and ordinals as the DXGI format set so
//! that images round-trip against other DXGI consumers without a
//! mapping table. Two private ordinals extend the set: `116`
//! (R10G10B10_7E3_A2_FLOAT) and `117` (R10G10B10_6E4_A2_FLOAT), the
//! Xbox packed-float back-buffer formats.
//!
//! A [`FormatDesc`] records the per-channel bit depth and a set of
//! classification flags for each convertible format. The descriptor
//! table is a process-lifetime constant; the converter compares the
//! flags of two formats to decide which channel adjustments a
//! conversion needs.

use bitflags::bitflags;

/// Pixel formats, name- and ordinal-compatible with `DXGI_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
#[allow(missing_docs)] // names mirror the DXGI enumeration one-for-one
pub enum PixelFormat {
    Unknown = 0,
    R32G32B32A32Typeless = 1,
    R32G32B32A32Float = 2,
    R32G32B32A32Uint = 3,
    R32G32B32A32Sint = 4,
    R32G32B32Typeless = 5,
    R32G32B32Float = 6,
    R32G32B32Uint = 7,
    R32G32B32Sint = 8,
    R16G16B16A16Typeless = 9,
    R16G16B16A16Float = 10,
    R16G16B16A16Unorm = 11,
    R16G16B16A16Uint = 12,
    R16G16B16A16Snorm = 13,
    R16G16B16A16Sint = 14,
    R32G32Typeless = 15,
    R32G32Float = 16,
    R32G32Uint = 17,
    R32G32Sint = 18,
    R32G8X24Typeless = 19,
    D32FloatS8X24Uint = 20,
    R32FloatX8X24Typeless = 21,
    X32TypelessG8X24Uint = 22,
    R10G10B10A2Typeless = 23,
    R10G10B10A2Unorm = 24,
    R10G10B10A2Uint = 25,
    R11G11B10Float = 26,
    R8G8B8A8Typeless = 27,
    R8G8B8A8Unorm = 28,
    R8G8B8A8UnormSrgb = 29,
    R8G8B8A8Uint = 30,
    R8G8B8A8Snorm = 31,
    R8G8B8A8Sint = 32,
    R16G16Typeless = 33,
    R16G16Float = 34,
    R16G16Unorm = 35,
    R16G16Uint = 36,
    R16G16Snorm = 37,
    R16G16Sint = 38,
    R32Typeless = 39,
    D32Float = 40,
    R32Float = 41,
    R32Uint = 42,
    R32Sint = 43,
    R24G8Typeless = 44,
    D24UnormS8Uint = 45,
    R24UnormX8Typeless = 46,
    X24TypelessG8Uint = 47,
    R8G8Typeless = 48,
    R8G8Unorm = 49,
    R8G8Uint = 50,
    R8G8Snorm = 51,
    R8G8Sint = 52,
    R16Typeless = 53,
    R16Float = 54,
    D16Unorm = 55,
    R16Unorm = 56,
    R16Uint = 57,
    R16Snorm = 58,
    R16Sint = 59,
    R8Typeless = 60,
    R8Unorm = 61,
    R8Uint = 62,
    R8Snorm = 63,
    R8Sint = 64,
    A8Unorm = 65,
    R1Unorm = 66,
    R9G9B9E5SharedExp = 67,
    R8G8B8G8Unorm = 68,
    G8R8G8B8Unorm = 69,
    Bc1Typeless = 70,
    Bc1Unorm = 71,
    Bc1UnormSrgb = 72,
    Bc2Typeless = 73,
    Bc2Unorm = 74,
    Bc2UnormSrgb = 75,
    Bc3Typeless = 76,
    Bc3Unorm = 77,
    Bc3UnormSrgb = 78,
    Bc4Typeless = 79,
    Bc4Unorm = 80,
    Bc4Snorm = 81,
    Bc5Typeless = 82,
    Bc5Unorm = 83,
    Bc5Snorm = 84,
    B5G6R5Unorm = 85,
    B5G5R5A1Unorm = 86,
    B8G8R8A8Unorm = 87,
    B8G8R8X8Unorm = 88,
    R10G10B10XrBiasA2Unorm = 89,
    B8G8R8A8Typeless = 90,
    B8G8R8A8UnormSrgb = 91,
    B8G8R8X8Typeless = 92,
    B8G8R8X8UnormSrgb = 93,
    Bc6hTypeless = 94,
    Bc6hUf16 = 95,
    Bc6hSf16 = 96,
    Bc7Typeless = 97,
    Bc7Unorm = 98,
    Bc7UnormSrgb = 99,
    Ayuv = 100,
    Y410 = 101,
    Y416 = 102,
    Nv12 = 103,
    P010 = 104,
    P016 = 105,
    Opaque420 = 106,
    Yuy2 = 107,
    Y210 = 108,
    Y216 = 109,
    Nv11 = 110,
    Ai44 = 111,
    Ia44 = 112,
    P8 = 113,
    A8P8 = 114,
    B4G4R4A4Unorm = 115,
    /// Xbox-only 7e3 packed-float back-buffer format (private ordinal).
    R10G10B10_7e3A2Float = 116,
    /// Xbox-only 6e4 packed-float back-buffer format (private ordinal).
    R10G10B10_6e4A2Float = 117,
}

bitflags! {
    /// Classification flags describing how a format's channels are
    /// encoded and which channels it carries.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FormatFlags: u32 {
        /// Floating point channels.
        const FLOAT = 0x1;
        /// Unsigned normalized channels.
        const UNORM = 0x2;
        /// Unsigned integer channels, not normalized.
        const UINT = 0x4;
        /// Signed normalized channels.
        const SNORM = 0x8;
        /// Signed integer channels, not normalized.
        const SINT = 0x10;
        /// Depth channel.
        const DEPTH = 0x20;
        /// Stencil channel.
        const STENCIL = 0x40;
        /// Shared-exponent packed float.
        const SHAREDEXP = 0x80;
        /// Block-compressed format.
        const BC = 0x100;
        /// Y'CbCr colour model.
        const YUV = 0x200;
        /// Two output pixels per packed element.
        const PACKED = 0x400;
        /// Blue/red channel order swapped on the wire.
        const BGR = 0x800;
        /// Extended-range biased fixed point.
        const XR = 0x1000;
        /// Red channel present.
        const R = 0x10000;
        /// Green channel present.
        const G = 0x20000;
        /// Blue channel present.
        const B = 0x40000;
        /// Alpha channel present.
        const A = 0x80000;
        /// Mask covering the RGB channel-presence bits.
        const RGB_MASK = 0x70000;
        /// Mask covering all channel-presence bits.
        const RGBA_MASK = 0xF0000;
    }
}

/// Conversion descriptor for one pixel format: the minimum channel bit
/// depth plus classification flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatDesc {
    /// Bit depth of the narrowest colour channel.
    pub bits: u32,
    /// Classification flags.
    pub flags: FormatFlags,
}

const fn desc(bits: u32, flags: FormatFlags) -> FormatDesc {
    FormatDesc { bits, flags }
}

impl PixelFormat {
    /// Looks up the conversion descriptor for this format.
    ///
    /// Returns `None` for typeless, planar, palettized, and opaque
    /// video formats, which the converter cannot reason about.
    #[must_use]
    pub fn descriptor(self) -> Option<FormatDesc> {
        use PixelFormat as F;
        const RGB: FormatFlags = FormatFlags::R.union(FormatFlags::G).union(FormatFlags::B);
        const RGBA: FormatFlags = RGB.union(FormatFlags::A);
        const RG: FormatFlags = FormatFlags::R.union(FormatFlags::G);

        let d = match self {
            F::R32G32B32A32Float => desc(32, FormatFlags::FLOAT.union(RGBA)),
            F::R32G32B32A32Uint => desc(32, FormatFlags::UINT.union(RGBA)),
            F::R32G32B32A32Sint => desc(32, FormatFlags::SINT.union(RGBA)),
            F::R32G32B32Float => desc(32, FormatFlags::FLOAT.union(RGB)),
            F::R32G32B32Uint => desc(32, FormatFlags::UINT.union(RGB)),
            F::R32G32B32Sint => desc(32, FormatFlags::SINT.union(RGB)),
            F::R16G16B16A16Float => desc(16, FormatFlags::FLOAT.union(RGBA)),
            F::R16G16B16A16Unorm => desc(16, FormatFlags::UNORM.union(RGBA)),
            F::R16G16B16A16Uint => desc(16, FormatFlags::UINT.union(RGBA)),
            F::R16G16B16A16Snorm => desc(16, FormatFlags::SNORM.union(RGBA)),
            F::R16G16B16A16Sint => desc(16, FormatFlags::SINT.union(RGBA)),
            F::R32G32Float => desc(32, FormatFlags::FLOAT.union(RG)),
            F::R32G32Uint => desc(32, FormatFlags::UINT.union(RG)),
            F::R32G32Sint => desc(32, FormatFlags::SINT.union(RG)),
            F::D32FloatS8X24Uint => desc(
                32,
                FormatFlags::FLOAT
                    .union(FormatFlags::DEPTH)
                    .union(FormatFlags::STENCIL),
            ),
            F::R10G10B10A2Unorm => desc(10, FormatFlags::UNORM.union(RGBA)),
            F::R10G10B10A2Uint => desc(10, FormatFlags::UINT.union(RGBA)),
            F::R11G11B10Float => desc(10, FormatFlags::FLOAT.union(RGB)),
            F::R8G8B8A8Unorm | F::R8G8B8A8UnormSrgb => desc(8, FormatFlags::UNORM.union(RGBA)),
            F::R8G8B8A8Uint => desc(8, FormatFlags::UINT.union(RGBA)),
            F::R8G8B8A8Snorm => desc(8, FormatFlags::SNORM.union(RGBA)),
            F::R8G8B8A8Sint => desc(8, FormatFlags::SINT.union(RGBA)),
            F::R16G16Float => desc(16, FormatFlags::FLOAT.union(RG)),
            F::R16G16Unorm => desc(16, FormatFlags::UNORM.union(RG)),
            F::R16G16Uint => desc(16, FormatFlags::UINT.union(RG)),
            F::R16G16Snorm => desc(16, FormatFlags::SNORM.union(RG)),
            F::R16G16Sint => desc(16, FormatFlags::SINT.union(RG)),
            F::D32Float => desc(32, FormatFlags::FLOAT.union(FormatFlags::DEPTH)),
            F::R32Float => desc(32, FormatFlags::FLOAT.union(FormatFlags::R)),
            F::R32Uint => desc(32, FormatFlags::UINT.union(FormatFlags::R)),
            F::R32Sint => desc(32, FormatFlags::SINT.union(FormatFlags::R)),
            F::D24UnormS8Uint => desc(
                32,
                FormatFlags::UNORM
                    .union(FormatFlags::DEPTH)
                    .union(FormatFlags::STENCIL),
            ),
            F::R24UnormX8Typeless => desc(24, FormatFlags::UNORM.union(FormatFlags::DEPTH)),
            F::X24TypelessG8Uint => desc(8, FormatFlags::UINT.union(FormatFlags::STENCIL)),
            F::R8G8Unorm => desc(8, FormatFlags::UNORM.union(RG)),
            F::R8G8Uint => desc(8, FormatFlags::UINT.union(RG)),
            F::R8G8Snorm => desc(8, FormatFlags::SNORM.union(RG)),
            F::R8G8Sint => desc(8, FormatFlags::SINT.union(RG)),
            F::R16Float => desc(16, FormatFlags::FLOAT.union(FormatFlags::R)),
            F::D16Unorm => desc(16, FormatFlags::UNORM.union(FormatFlags::DEPTH)),
            F::R16Unorm => desc(16, FormatFlags::UNORM.union(FormatFlags::R)),
            F::R16Uint => desc(16, FormatFlags::UINT.union(FormatFlags::R)),
            F::R16Snorm => desc(16, FormatFlags::SNORM.union(FormatFlags::R)),
            F::R16Sint => desc(16, FormatFlags::SINT.union(FormatFlags::R)),
            F::R8Unorm => desc(8, FormatFlags::UNORM.union(FormatFlags::R)),
            F::R8Uint => desc(8, FormatFlags::UINT.union(FormatFlags::R)),
            F::R8Snorm => desc(8, FormatFlags::SNORM.union(FormatFlags::R)),
            F::R8Sint => desc(8, FormatFlags::SINT.union(FormatFlags::R)),
            F::A8Unorm => desc(8, FormatFlags::UNORM.union(FormatFlags::A)),
            F::R1Unorm => desc(1, FormatFlags::UNORM.union(FormatFlags::R)),
            F::R9G9B9E5SharedExp => desc(9, FormatFlags::SHAREDEXP.union(RGB)),
            F::R8G8B8G8Unorm | F::G8R8G8B8Unorm => {
                desc(8, FormatFlags::UNORM.union(FormatFlags::PACKED).union(RGB))
            }
            F::Bc1Unorm | F::Bc1UnormSrgb | F::Bc2Unorm | F::Bc2UnormSrgb | F::Bc3Unorm
            | F::Bc3UnormSrgb => desc(8, FormatFlags::UNORM.union(FormatFlags::BC).union(RGBA)),
            F::Bc4Unorm => desc(
                8,
                FormatFlags::UNORM.union(FormatFlags::BC).union(FormatFlags::R),
            ),
            F::Bc4Snorm => desc(
                8,
                FormatFlags::SNORM.union(FormatFlags::BC).union(FormatFlags::R),
            ),
            F::Bc5Unorm => desc(8, FormatFlags::UNORM.union(FormatFlags::BC).union(RG)),
            F::Bc5Snorm => desc(8, FormatFlags::SNORM.union(FormatFlags::BC).union(RG)),
            F::B5G6R5Unorm => desc(5, FormatFlags::UNORM.union(RGB)),
            F::B5G5R5A1Unorm => desc(5, FormatFlags::UNORM.union(RGBA)),
            F::B8G8R8A8Unorm | F::B8G8R8A8UnormSrgb => {
                desc(8, FormatFlags::UNORM.union(FormatFlags::BGR).union(RGBA))
            }
            F::B8G8R8X8Unorm | F::B8G8R8X8UnormSrgb => {
                desc(8, FormatFlags::UNORM.union(FormatFlags::BGR).union(RGB))
            }
            F::R10G10B10XrBiasA2Unorm => {
                desc(10, FormatFlags::UNORM.union(FormatFlags::XR).union(RGBA))
            }
            F::Bc6hUf16 | F::Bc6hSf16 => {
                desc(16, FormatFlags::FLOAT.union(FormatFlags::BC).union(RGBA))
            }
            F::Bc7Unorm | F::Bc7UnormSrgb => {
                desc(8, FormatFlags::UNORM.union(FormatFlags::BC).union(RGBA))
            }
            F::Ayuv => desc(8, FormatFlags::UNORM.union(FormatFlags::YUV).union(RGBA)),
            F::Y410 => desc(10, FormatFlags::UNORM.union(FormatFlags::YUV).union(RGBA)),
            F::Y416 => desc(16, FormatFlags::UNORM.union(FormatFlags::YUV).union(RGBA)),
            F::Yuy2 => desc(
                8,
                FormatFlags::UNORM
                    .union(FormatFlags::YUV)
                    .union(FormatFlags::PACKED)
                    .union(RGB),
            ),
            F::Y210 => desc(
                10,
                FormatFlags::UNORM
                    .union(FormatFlags::YUV)
                    .union(FormatFlags::PACKED)
                    .union(RGB),
            ),
            F::Y216 => desc(
                16,
                FormatFlags::UNORM
                    .union(FormatFlags::YUV)
                    .union(FormatFlags::PACKED)
                    .union(RGB),
            ),
            F::B4G4R4A4Unorm => desc(4, FormatFlags::UNORM.union(FormatFlags::BGR).union(RGBA)),
            F::R10G10B10_7e3A2Float | F::R10G10B10_6e4A2Float => {
                desc(10, FormatFlags::FLOAT.union(RGBA))
            }
            _ => return None,
        };
        Some(d)
    }

    /// Bits per pixel of the format, or 0 when unknown.
    #[must_use]
    pub fn bits_per_pixel(self) -> usize {
        use PixelFormat as F;
        match self {
            F::R32G32B32A32Typeless | F::R32G32B32A32Float | F::R32G32B32A32Uint
            | F::R32G32B32A32Sint => 128,
            F::R32G32B32Typeless | F::R32G32B32Float | F::R32G32B32Uint | F::R32G32B32Sint => 96,
            F::R16G16B16A16Typeless | F::R16G16B16A16Float | F::R16G16B16A16Unorm
            | F::R16G16B16A16Uint | F::R16G16B16A16Snorm | F::R16G16B16A16Sint
            | F::R32G32Typeless | F::R32G32Float | F::R32G32Uint | F::R32G32Sint
            | F::R32G8X24Typeless | F::D32FloatS8X24Uint | F::R32FloatX8X24Typeless
            | F::X32TypelessG8X24Uint | F::Y416 | F::Y210 | F::Y216 => 64,
            F::R10G10B10A2Typeless | F::R10G10B10A2Unorm | F::R10G10B10A2Uint
            | F::R11G11B10Float | F::R8G8B8A8Typeless | F::R8G8B8A8Unorm
            | F::R8G8B8A8UnormSrgb | F::R8G8B8A8Uint | F::R8G8B8A8Snorm | F::R8G8B8A8Sint
            | F::R16G16Typeless | F::R16G16Float | F::R16G16Unorm | F::R16G16Uint
            | F::R16G16Snorm | F::R16G16Sint | F::R32Typeless | F::D32Float | F::R32Float
            | F::R32Uint | F::R32Sint | F::R24G8Typeless | F::D24UnormS8Uint
            | F::R24UnormX8Typeless | F::X24TypelessG8Uint | F::R9G9B9E5SharedExp
            | F::R8G8B8G8Unorm | F::G8R8G8B8Unorm | F::B8G8R8A8Unorm | F::B8G8R8X8Unorm
            | F::R10G10B10XrBiasA2Unorm | F::B8G8R8A8Typeless | F::B8G8R8A8UnormSrgb
            | F::B8G8R8X8Typeless | F::B8G8R8X8UnormSrgb | F::Ayuv | F::Y410 | F::Yuy2
            | F::R10G10B10_7e3A2Float | F::R10G10B10_6e4A2Float => 32,
            F::P010 | F::P016 => 24,
            F::R8G8Typeless | F::R8G8Unorm | F::R8G8Uint | F::R8G8Snorm | F::R8G8Sint
            | F::R16Typeless | F::R16Float | F::D16Unorm | F::R16Unorm | F::R16Uint
            | F::R16Snorm | F::R16Sint | F::B5G6R5Unorm | F::B5G5R5A1Unorm
            | F::B4G4R4A4Unorm | F::A8P8 => 16,
            F::Nv12 | F::Opaque420 | F::Nv11 => 12,
            F::R8Typeless | F::R8Unorm | F::R8Uint | F::R8Snorm | F::R8Sint | F::A8Unorm
            | F::Ai44 | F::Ia44 | F::P8 => 8,
            F::Bc1Typeless | F::Bc1Unorm | F::Bc1UnormSrgb | F::Bc4Typeless | F::Bc4Unorm
            | F::Bc4Snorm => 4,
            F::Bc2Typeless | F::Bc2Unorm | F::Bc2UnormSrgb | F::Bc3Typeless | F::Bc3Unorm
            | F::Bc3UnormSrgb | F::Bc5Typeless | F::Bc5Unorm | F::Bc5Snorm | F::Bc6hTypeless
            | F::Bc6hUf16 | F::Bc6hSf16 | F::Bc7Typeless | F::Bc7Unorm | F::Bc7UnormSrgb => 8,
            F::R1Unorm => 1,
            F::Unknown => 0,
        }
    }

    /// Whether the format is one of the BC block-compressed formats.
    #[must_use]
    pub fn is_compressed(self) -> bool {
        use PixelFormat as F;
        matches!(
            self,
            F::Bc1Typeless
                | F::Bc1Unorm
                | F::Bc1UnormSrgb
                | F::Bc2Typeless
                | F::Bc2Unorm
                | F::Bc2UnormSrgb
                | F::Bc3Typeless
                | F::Bc3Unorm
                | F::Bc3UnormSrgb
                | F::Bc4Typeless
                | F::Bc4Unorm
                | F::Bc4Snorm
                | F::Bc5Typeless
                | F::Bc5Unorm
                | F::Bc5Snorm
                | F::Bc6hTypeless
                | F::Bc6hUf16
                | F::Bc6hSf16
                | F::Bc7Typeless
                | F::Bc7Unorm
                | F::Bc7UnormSrgb
        )
    }

    /// Whether the format stores chroma on a separate plane.
    #[must_use]
    pub fn is_planar(self) -> bool {
        use PixelFormat as F;
        matches!(self, F::Nv12 | F::P010 | F::P016 | F::Opaque420 | F::Nv11)
    }

    /// Whether the format carries an sRGB-encoded colour ramp.
    #[must_use]
    pub fn is_srgb(self) -> bool {
        use PixelFormat as F;
        matches!(
            self,
            F::R8G8B8A8UnormSrgb
                | F::B8G8R8A8UnormSrgb
                | F::B8G8R8X8UnormSrgb
                | F::Bc1UnormSrgb
                | F::Bc2UnormSrgb
                | F::Bc3UnormSrgb
                | F::Bc7UnormSrgb
        )
    }

    /// Whether the format is palettized.
    #[must_use]
    pub fn is_palettized(self) -> bool {
        use PixelFormat as F;
        matches!(self, F::Ai44 | F::Ia44 | F::P8 | F::A8P8)
    }

    /// Bytes in one 4x4 compressed block, or 0 for uncompressed formats.
    #[must_use]
    pub fn block_bytes(self) -> usize {
        use PixelFormat as F;
        match self {
            F::Bc1Typeless | F::Bc1Unorm | F::Bc1UnormSrgb | F::Bc4Typeless | F::Bc4Unorm
            | F::Bc4Snorm => 8,
            _ if self.is_compressed() => 16,
            _ => 0,
        }
    }

    /// Row pitch in bytes for an image of `width` pixels.
    ///
    /// For BC formats this is the pitch of one block row,
    /// `ceil(width / 4) * block_bytes`. Dual-pixel packed formats
    /// round the row up to whole elements; planar pitches cover the
    /// luma plane.
    #[must_use]
    pub fn row_pitch(self, width: usize) -> usize {
        use PixelFormat as F;
        match self {
            _ if self.is_compressed() => width.div_ceil(4) * self.block_bytes(),
            F::Yuy2 | F::R8G8B8G8Unorm | F::G8R8G8B8Unorm => width.div_ceil(2) * 4,
            F::Y210 | F::Y216 => width.div_ceil(2) * 8,
            F::Nv12 | F::Opaque420 => width.div_ceil(2) * 2,
            F::P010 | F::P016 => width.div_ceil(2) * 4,
            F::Nv11 => width.div_ceil(4) * 4,
            _ => (width * self.bits_per_pixel() + 7) / 8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordinals_match_dxgi() {
        assert_eq!(PixelFormat::R8G8B8A8Unorm as u32, 28);
        assert_eq!(PixelFormat::B8G8R8A8Unorm as u32, 87);
        assert_eq!(PixelFormat::Bc7UnormSrgb as u32, 99);
        assert_eq!(PixelFormat::B4G4R4A4Unorm as u32, 115);
        assert_eq!(PixelFormat::R10G10B10_7e3A2Float as u32, 116);
        assert_eq!(PixelFormat::R10G10B10_6e4A2Float as u32, 117);
    }

    #[test]
    fn test_descriptor_flags() {
        let d = PixelFormat::R8G8B8A8Unorm.descriptor().unwrap();
        assert_eq!(d.bits, 8);
        assert!(d.flags.contains(FormatFlags::UNORM));
        assert!(d.flags.contains(FormatFlags::A));

        let d = PixelFormat::B5G6R5Unorm.descriptor().unwrap();
        assert_eq!(d.bits, 5);
        assert!(!d.flags.contains(FormatFlags::A));

        assert!(PixelFormat::Nv12.descriptor().is_none());
        assert!(PixelFormat::R8G8B8A8Typeless.descriptor().is_none());
    }

    #[test]
    fn test_block_sizes() {
        assert_eq!(PixelFormat::Bc1Unorm.block_bytes(), 8);
        assert_eq!(PixelFormat::Bc4Snorm.block_bytes(), 8);
        assert_eq!(PixelFormat::Bc3Unorm.block_bytes(), 16);
        assert_eq!(PixelFormat::Bc6hUf16.block_bytes(), 16);
        assert_eq!(PixelFormat::Bc7Unorm.block_bytes(), 16);
        assert_eq!(PixelFormat::R8G8B8A8Unorm.block_bytes(), 0);
    }

    #[test]
    fn test_row_pitch() {
        assert_eq!(PixelFormat::R8G8B8A8Unorm.row_pitch(16), 64);
        assert_eq!(PixelFormat::B5G6R5Unorm.row_pitch(3), 6);
        // 5 pixels of BC1 round up to two 8-byte blocks
        assert_eq!(PixelFormat::Bc1Unorm.row_pitch(5), 16);
        assert_eq!(PixelFormat::Bc7Unorm.row_pitch(4), 16);
        assert_eq!(PixelFormat::R1Unorm.row_pitch(9), 2);
    }
}
