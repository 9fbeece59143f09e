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

//! Scanline codec: one row of pixels to or from canonical `Rgba`.
//!
//! [`load_scanline`] widens any supported on-wire format into `Rgba`;
//! [`store_scanline`] narrows back, and [`store_scanline_dither`] adds
//! ordered or error-diffusion dithering. The `_linear` wrappers fold
//! the sRGB transfer function in for formats that can carry sRGB data.
//!
//! Three integer fast paths bypass the float pipeline entirely:
//! [`copy_scanline`] (row copy with optional alpha fill),
//! [`swizzle_scanline`] (red/blue channel exchange), and
//! [`expand_scanline`] (legacy 16-bit formats into RGBA8).

mod load;
mod packed;
mod store;

pub use load::load_scanline;
pub use packed::{linear_to_srgb, srgb_to_linear};
pub use store::{store_scanline, store_scanline_dither};

use crate::format::{FormatFlags, PixelFormat};
use crate::pixel::Rgba;
use packed::{linear_to_srgb_rgb, srgb_to_linear_rgb};

/// Whether the sRGB transfer function may be applied to this format.
///
/// Depth, extended-range, YUV, signed, and pure-integer layouts never
/// carry sRGB-encoded data, nor do the Xbox packed floats.
pub(crate) fn srgb_capable(format: PixelFormat) -> bool {
    if matches!(
        format,
        PixelFormat::A8Unorm
            | PixelFormat::R10G10B10_7e3A2Float
            | PixelFormat::R10G10B10_6e4A2Float
    ) {
        return false;
    }
    format.descriptor().is_some_and(|d| {
        d.flags
            .intersects(FormatFlags::UNORM | FormatFlags::FLOAT)
            && !d.flags.intersects(
                FormatFlags::DEPTH
                    | FormatFlags::XR
                    | FormatFlags::YUV
                    | FormatFlags::SNORM
                    | FormatFlags::UINT
                    | FormatFlags::SINT
                    | FormatFlags::BC,
            )
    })
}

/// Loads one row, linearising sRGB-encoded colour channels.
///
/// The transform applies when the format itself is sRGB-declared, or
/// when `srgb_in` is set and the format can carry sRGB data.
pub fn load_scanline_linear(
    format: PixelFormat,
    src: &[u8],
    dst: &mut [Rgba],
    srgb_in: bool,
) -> bool {
    let apply = format.is_srgb() || (srgb_in && srgb_capable(format));
    if !load_scanline(format, src, dst) {
        return false;
    }
    if apply {
        for p in dst.iter_mut() {
            *p = srgb_to_linear_rgb(*p);
        }
    }
    true
}

/// Stores one row, applying the inverse sRGB transfer to the colour
/// channels first when appropriate. The source row is consumed
/// destructively.
pub fn store_scanline_linear(
    format: PixelFormat,
    src: &mut [Rgba],
    dst: &mut [u8],
    srgb_out: bool,
) -> bool {
    let apply = format.is_srgb() || (srgb_out && srgb_capable(format));
    if apply {
        for p in src.iter_mut() {
            *p = linear_to_srgb_rgb(*p);
        }
    }
    store_scanline(format, src, dst)
}

/// Copies a row of `format` pixels, optionally forcing every alpha
/// value to fully opaque. Source and destination may be the same
/// length; `src` may alias `dst` by passing the same row twice via a
/// prior copy.
pub fn copy_scanline(format: PixelFormat, src: &[u8], dst: &mut [u8], set_alpha: bool) -> bool {
    use PixelFormat as F;
    let n = src.len().min(dst.len());
    dst[..n].copy_from_slice(&src[..n]);
    if !set_alpha {
        return true;
    }

    match format {
        F::R32G32B32A32Float => {
            for px in dst[..n].chunks_exact_mut(16) {
                px[12..16].copy_from_slice(&1.0f32.to_le_bytes());
            }
            true
        }
        F::R32G32B32A32Uint | F::R32G32B32A32Sint => {
            for px in dst[..n].chunks_exact_mut(16) {
                px[12..16].copy_from_slice(&1u32.to_le_bytes());
            }
            true
        }
        F::R16G16B16A16Float => {
            for px in dst[..n].chunks_exact_mut(8) {
                px[6..8].copy_from_slice(&0x3c00u16.to_le_bytes());
            }
            true
        }
        F::R16G16B16A16Unorm | F::R16G16B16A16Uint => {
            for px in dst[..n].chunks_exact_mut(8) {
                px[6..8].copy_from_slice(&0xffffu16.to_le_bytes());
            }
            true
        }
        F::R16G16B16A16Snorm | F::R16G16B16A16Sint => {
            for px in dst[..n].chunks_exact_mut(8) {
                px[6..8].copy_from_slice(&0x7fffu16.to_le_bytes());
            }
            true
        }
        F::R10G10B10A2Unorm | F::R10G10B10A2Uint | F::R10G10B10XrBiasA2Unorm | F::Y410 => {
            for px in dst[..n].chunks_exact_mut(4) {
                px[3] |= 0xc0;
            }
            true
        }
        F::R8G8B8A8Unorm | F::R8G8B8A8UnormSrgb | F::R8G8B8A8Uint | F::B8G8R8A8Unorm
        | F::B8G8R8A8UnormSrgb | F::Ayuv => {
            for px in dst[..n].chunks_exact_mut(4) {
                px[3] = 0xff;
            }
            true
        }
        F::R8G8B8A8Snorm | F::R8G8B8A8Sint => {
            for px in dst[..n].chunks_exact_mut(4) {
                px[3] = 0x7f;
            }
            true
        }
        F::B5G5R5A1Unorm => {
            for px in dst[..n].chunks_exact_mut(2) {
                px[1] |= 0x80;
            }
            true
        }
        F::B4G4R4A4Unorm => {
            for px in dst[..n].chunks_exact_mut(2) {
                px[1] |= 0xf0;
            }
            true
        }
        F::A8Unorm => {
            for px in dst[..n].iter_mut() {
                *px = 0xff;
            }
            true
        }
        _ => false,
    }
}

/// Exchanges the red and blue channels of a row without leaving the
/// integer domain. Supports the 8:8:8:8 and 10:10:10:2 layouts.
pub fn swizzle_scanline(format: PixelFormat, src: &[u8], dst: &mut [u8]) -> bool {
    use PixelFormat as F;
    match format {
        F::R10G10B10A2Unorm | F::R10G10B10A2Uint | F::R10G10B10XrBiasA2Unorm => {
            if dst.len() < src.len() & !3 {
                return false;
            }
            for (s, d) in src.chunks_exact(4).zip(dst.chunks_exact_mut(4)) {
                let v = u32::from_le_bytes([s[0], s[1], s[2], s[3]]);
                let t = (v & 0x3ff0_0c00) | ((v & 0x3ff) << 20) | ((v >> 20) & 0x3ff);
                d.copy_from_slice(&t.to_le_bytes());
            }
            true
        }
        F::R8G8B8A8Unorm | F::R8G8B8A8UnormSrgb | F::B8G8R8A8Unorm | F::B8G8R8A8UnormSrgb
        | F::B8G8R8X8Unorm | F::B8G8R8X8UnormSrgb => {
            if dst.len() < src.len() & !3 {
                return false;
            }
            for (s, d) in src.chunks_exact(4).zip(dst.chunks_exact_mut(4)) {
                d[0] = s[2];
                d[1] = s[1];
                d[2] = s[0];
                d[3] = s[3];
            }
            true
        }
        _ => false,
    }
}

/// Widens a row of one of the three legacy 16-bit formats into RGBA8
/// without the float pipeline.
pub fn expand_scanline(
    src_format: PixelFormat,
    dst_format: PixelFormat,
    src: &[u8],
    dst: &mut [u8],
) -> bool {
    use PixelFormat as F;
    if !matches!(dst_format, F::R8G8B8A8Unorm | F::R8G8B8A8UnormSrgb) {
        return false;
    }

    let count = src.len() / 2;
    if dst.len() < count * 4 {
        return false;
    }

    let up5 = |v: u16| -> u8 {
        let v = (v & 31) as u8;
        (v << 3) | (v >> 2)
    };
    let up6 = |v: u16| -> u8 {
        let v = (v & 63) as u8;
        (v << 2) | (v >> 4)
    };
    let up4 = |v: u16| -> u8 {
        let v = (v & 15) as u8;
        (v << 4) | v
    };

    match src_format {
        F::B5G6R5Unorm => {
            for (s, d) in src.chunks_exact(2).zip(dst.chunks_exact_mut(4)) {
                let v = u16::from_le_bytes([s[0], s[1]]);
                d[0] = up5(v >> 11);
                d[1] = up6(v >> 5);
                d[2] = up5(v);
                d[3] = 0xff;
            }
            true
        }
        F::B5G5R5A1Unorm => {
            for (s, d) in src.chunks_exact(2).zip(dst.chunks_exact_mut(4)) {
                let v = u16::from_le_bytes([s[0], s[1]]);
                d[0] = up5(v >> 10);
                d[1] = up5(v >> 5);
                d[2] = up5(v);
                d[3] = if v & 0x8000 != 0 { 0xff } else { 0 };
            }
            true
        }
        F::B4G4R4A4Unorm => {
            for (s, d) in src.chunks_exact(2).zip(dst.chunks_exact_mut(4)) {
                let v = u16::from_le_bytes([s[0], s[1]]);
                d[0] = up4(v >> 8);
                d[1] = up4(v >> 4);
                d[2] = up4(v);
                d[3] = up4(v >> 12);
            }
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_srgb_declared_format_linearises_on_load() {
        let src = [188u8, 188, 188, 255];
        let mut linear = [Rgba::ZERO; 1];
        assert!(load_scanline_linear(
            PixelFormat::R8G8B8A8UnormSrgb,
            &src,
            &mut linear,
            false,
        ));
        // sRGB 188/255 is roughly linear 0.5.
        assert!((linear[0].r - 0.5).abs() < 0.01, "r={}", linear[0].r);
        assert_eq!(linear[0].a, 1.0);
    }

    #[test]
    fn test_srgb_round_trip_through_store() {
        let mut row = [Rgba::new(0.2, 0.5, 0.8, 1.0)];
        let mut bytes = [0u8; 4];
        assert!(store_scanline_linear(
            PixelFormat::R8G8B8A8UnormSrgb,
            &mut row,
            &mut bytes,
            false,
        ));
        let mut back = [Rgba::ZERO; 1];
        assert!(load_scanline_linear(
            PixelFormat::R8G8B8A8UnormSrgb,
            &bytes,
            &mut back,
            false,
        ));
        assert!((back[0].r - 0.2).abs() < 1.0 / 255.0 + 1e-4);
        assert!((back[0].g - 0.5).abs() < 1.0 / 255.0 + 1e-4);
        assert!((back[0].b - 0.8).abs() < 1.0 / 255.0 + 1e-4);
    }

    #[test]
    fn test_srgb_flag_ignored_for_incapable_formats() {
        let src = 0.5f32.to_le_bytes();
        let mut dst = [Rgba::ZERO; 1];
        assert!(load_scanline_linear(PixelFormat::D32Float, &src, &mut dst, true));
        assert_eq!(dst[0].r, 0.5);
    }

    #[test]
    fn test_copy_scanline_sets_alpha() {
        let src = [1u8, 2, 3, 4, 5, 6, 7, 8];
        let mut dst = [0u8; 8];
        assert!(copy_scanline(PixelFormat::R8G8B8A8Unorm, &src, &mut dst, true));
        assert_eq!(dst, [1, 2, 3, 255, 5, 6, 7, 255]);
    }

    #[test]
    fn test_swizzle_matches_general_path() {
        let src = [10u8, 20, 30, 40];
        let mut fast = [0u8; 4];
        assert!(swizzle_scanline(PixelFormat::R8G8B8A8Unorm, &src, &mut fast));

        // The general path: load as RGBA, store as BGRA.
        let mut px = [Rgba::ZERO; 1];
        assert!(load_scanline(PixelFormat::R8G8B8A8Unorm, &src, &mut px));
        let mut general = [0u8; 4];
        assert!(store_scanline(PixelFormat::B8G8R8A8Unorm, &px, &mut general));

        assert_eq!(fast, general);
    }

    #[test]
    fn test_swizzle_10bit_swaps_fields() {
        let v: u32 = 1 | (2 << 10) | (3 << 20) | (1 << 30);
        let mut dst = [0u8; 4];
        assert!(swizzle_scanline(
            PixelFormat::R10G10B10A2Unorm,
            &v.to_le_bytes(),
            &mut dst,
        ));
        let t = u32::from_le_bytes(dst);
        assert_eq!(t & 0x3ff, 3);
        assert_eq!((t >> 10) & 0x3ff, 2);
        assert_eq!((t >> 20) & 0x3ff, 1);
        assert_eq!(t >> 30, 1);
    }

    #[test]
    fn test_expand_565() {
        let v: u16 = (31 << 11) | (32 << 5) | 0;
        let mut dst = [0u8; 4];
        assert!(expand_scanline(
            PixelFormat::B5G6R5Unorm,
            PixelFormat::R8G8B8A8Unorm,
            &v.to_le_bytes(),
            &mut dst,
        ));
        assert_eq!(dst[0], 255);
        assert_eq!(dst[1], (32 << 2) | (32 >> 4));
        assert_eq!(dst[2], 0);
        assert_eq!(dst[3], 255);
    }
}
