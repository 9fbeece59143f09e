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

//! Scanline widening: one row of any supported format into canonical
//! `Rgba` pixels.
//!
//! Instead of a separate body per format, each match arm hands a small
//! per-element closure to a generic walker parameterised by the element
//! size. Formats without an alpha channel load alpha as 1.0; missing
//! colour channels load as 0.

use super::packed::{f32_from_6e4, f32_from_7e3, unpack_r11g11b10, unpack_rgb9e5};
use crate::format::PixelFormat;
use crate::pixel::{f16_to_f32, Rgba};

#[inline]
fn u16_le(b: &[u8]) -> u16 {
    u16::from_le_bytes([b[0], b[1]])
}

#[inline]
fn u32_le(b: &[u8]) -> u32 {
    u32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

#[inline]
fn f32_le(b: &[u8]) -> f32 {
    f32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

#[inline]
fn un8(v: u8) -> f32 {
    f32::from(v) / 255.0
}

#[inline]
fn sn8(v: u8) -> f32 {
    (f32::from(v as i8) / 127.0).max(-1.0)
}

#[inline]
fn un16(v: u16) -> f32 {
    f32::from(v) / 65535.0
}

#[inline]
fn sn16(v: u16) -> f32 {
    (f32::from(v as i16) / 32767.0).max(-1.0)
}

/// Walks `dst.len()` elements of `bpp` bytes each, widening every
/// element into one pixel. Fails when the source row is short.
fn per_element(src: &[u8], dst: &mut [Rgba], bpp: usize, f: impl Fn(&[u8]) -> Rgba) -> bool {
    if src.len() < dst.len() * bpp {
        return false;
    }
    for (i, d) in dst.iter_mut().enumerate() {
        *d = f(&src[i * bpp..(i + 1) * bpp]);
    }
    true
}

/// Walks elements that expand to two pixels each (packed YUV and the
/// shared-chroma RGB quadlets). The row is rounded up to element pairs.
fn per_element_pair(
    src: &[u8],
    dst: &mut [Rgba],
    bpp: usize,
    f: impl Fn(&[u8]) -> (Rgba, Rgba),
) -> bool {
    let pairs = dst.len().div_ceil(2);
    if src.len() < pairs * bpp {
        return false;
    }
    for (i, chunk) in dst.chunks_mut(2).enumerate() {
        let (p0, p1) = f(&src[i * bpp..(i + 1) * bpp]);
        chunk[0] = p0;
        if let Some(second) = chunk.get_mut(1) {
            *second = p1;
        }
    }
    true
}

/// Converts the ITU-R BT.601 8-bit Y'CbCr triple to RGB in `[0, 255]`.
#[inline]
fn yuv8_to_rgb(y: i32, u: i32, v: i32) -> (i32, i32, i32) {
    let r = (298 * y + 409 * v + 128) >> 8;
    let g = (298 * y - 100 * u - 208 * v + 128) >> 8;
    let b = (298 * y + 516 * u + 128) >> 8;
    (r, g, b)
}

/// 10-bit variant of the Y'CbCr matrix, in `[0, 1023]`.
#[inline]
fn yuv10_to_rgb(y: i64, u: i64, v: i64) -> (i32, i32, i32) {
    let r = (76533 * y + 104905 * v + 32768) >> 16;
    let g = (76533 * y - 25747 * u - 53425 * v + 32768) >> 16;
    let b = (76533 * y + 132590 * u + 32768) >> 16;
    (r as i32, g as i32, b as i32)
}

/// 16-bit variant of the Y'CbCr matrix, in `[0, 65535]`.
#[inline]
fn yuv16_to_rgb(y: i64, u: i64, v: i64) -> (i32, i32, i32) {
    let r = (76607 * y + 105006 * v + 32768) >> 16;
    let g = (76607 * y - 25772 * u - 53477 * v + 32768) >> 16;
    let b = (76607 * y + 132718 * u + 32768) >> 16;
    (r as i32, g as i32, b as i32)
}

#[inline]
fn clamp_scale(v: i32, max: i32) -> f32 {
    v.clamp(0, max) as f32 / max as f32
}

/// Loads one row of `format` pixels from `src` into canonical `Rgba`.
///
/// Returns `false` when the format is not supported by the scanline
/// codec or the source does not cover `dst.len()` pixels.
#[allow(clippy::too_many_lines)] // one arm per format family
pub fn load_scanline(format: PixelFormat, src: &[u8], dst: &mut [Rgba]) -> bool {
    use PixelFormat as F;
    match format {
        F::R32G32B32A32Float => per_element(src, dst, 16, |b| {
            Rgba::new(f32_le(b), f32_le(&b[4..]), f32_le(&b[8..]), f32_le(&b[12..]))
        }),
        F::R32G32B32A32Uint => per_element(src, dst, 16, |b| {
            Rgba::new(
                u32_le(b) as f32,
                u32_le(&b[4..]) as f32,
                u32_le(&b[8..]) as f32,
                u32_le(&b[12..]) as f32,
            )
        }),
        F::R32G32B32A32Sint => per_element(src, dst, 16, |b| {
            Rgba::new(
                u32_le(b) as i32 as f32,
                u32_le(&b[4..]) as i32 as f32,
                u32_le(&b[8..]) as i32 as f32,
                u32_le(&b[12..]) as i32 as f32,
            )
        }),
        F::R32G32B32Float => per_element(src, dst, 12, |b| {
            Rgba::new(f32_le(b), f32_le(&b[4..]), f32_le(&b[8..]), 1.0)
        }),
        F::R32G32B32Uint => per_element(src, dst, 12, |b| {
            Rgba::new(
                u32_le(b) as f32,
                u32_le(&b[4..]) as f32,
                u32_le(&b[8..]) as f32,
                1.0,
            )
        }),
        F::R32G32B32Sint => per_element(src, dst, 12, |b| {
            Rgba::new(
                u32_le(b) as i32 as f32,
                u32_le(&b[4..]) as i32 as f32,
                u32_le(&b[8..]) as i32 as f32,
                1.0,
            )
        }),
        F::R16G16B16A16Float => per_element(src, dst, 8, |b| {
            Rgba::new(
                f16_to_f32(u16_le(b)),
                f16_to_f32(u16_le(&b[2..])),
                f16_to_f32(u16_le(&b[4..])),
                f16_to_f32(u16_le(&b[6..])),
            )
        }),
        F::R16G16B16A16Unorm => per_element(src, dst, 8, |b| {
            Rgba::new(
                un16(u16_le(b)),
                un16(u16_le(&b[2..])),
                un16(u16_le(&b[4..])),
                un16(u16_le(&b[6..])),
            )
        }),
        F::R16G16B16A16Uint => per_element(src, dst, 8, |b| {
            Rgba::new(
                f32::from(u16_le(b)),
                f32::from(u16_le(&b[2..])),
                f32::from(u16_le(&b[4..])),
                f32::from(u16_le(&b[6..])),
            )
        }),
        F::R16G16B16A16Snorm => per_element(src, dst, 8, |b| {
            Rgba::new(
                sn16(u16_le(b)),
                sn16(u16_le(&b[2..])),
                sn16(u16_le(&b[4..])),
                sn16(u16_le(&b[6..])),
            )
        }),
        F::R16G16B16A16Sint => per_element(src, dst, 8, |b| {
            Rgba::new(
                f32::from(u16_le(b) as i16),
                f32::from(u16_le(&b[2..]) as i16),
                f32::from(u16_le(&b[4..]) as i16),
                f32::from(u16_le(&b[6..]) as i16),
            )
        }),
        F::R32G32Float => per_element(src, dst, 8, |b| {
            Rgba::new(f32_le(b), f32_le(&b[4..]), 0.0, 1.0)
        }),
        F::R32G32Uint => per_element(src, dst, 8, |b| {
            Rgba::new(u32_le(b) as f32, u32_le(&b[4..]) as f32, 0.0, 1.0)
        }),
        F::R32G32Sint => per_element(src, dst, 8, |b| {
            Rgba::new(u32_le(b) as i32 as f32, u32_le(&b[4..]) as i32 as f32, 0.0, 1.0)
        }),
        F::D32FloatS8X24Uint => per_element(src, dst, 8, |b| {
            Rgba::new(f32_le(b), (u32_le(&b[4..]) & 0xff) as f32, 0.0, 1.0)
        }),
        F::R32FloatX8X24Typeless => {
            per_element(src, dst, 8, |b| Rgba::new(f32_le(b), 0.0, 0.0, 1.0))
        }
        F::X32TypelessG8X24Uint => per_element(src, dst, 8, |b| {
            Rgba::new(0.0, (u32_le(&b[4..]) & 0xff) as f32, 0.0, 1.0)
        }),
        F::R10G10B10A2Unorm => per_element(src, dst, 4, |b| {
            let v = u32_le(b);
            Rgba::new(
                (v & 0x3ff) as f32 / 1023.0,
                ((v >> 10) & 0x3ff) as f32 / 1023.0,
                ((v >> 20) & 0x3ff) as f32 / 1023.0,
                (v >> 30) as f32 / 3.0,
            )
        }),
        F::R10G10B10XrBiasA2Unorm => per_element(src, dst, 4, |b| {
            // Extended range: 0x180 is the zero point, full scale 510.
            let v = u32_le(b);
            let xr = |c: u32| (c as f32 - 384.0) / 510.0;
            Rgba::new(
                xr(v & 0x3ff),
                xr((v >> 10) & 0x3ff),
                xr((v >> 20) & 0x3ff),
                (v >> 30) as f32 / 3.0,
            )
        }),
        F::R10G10B10A2Uint => per_element(src, dst, 4, |b| {
            let v = u32_le(b);
            Rgba::new(
                (v & 0x3ff) as f32,
                ((v >> 10) & 0x3ff) as f32,
                ((v >> 20) & 0x3ff) as f32,
                (v >> 30) as f32,
            )
        }),
        F::R11G11B10Float => per_element(src, dst, 4, |b| {
            let (r, g, bl) = unpack_r11g11b10(u32_le(b));
            Rgba::new(r, g, bl, 1.0)
        }),
        F::R8G8B8A8Unorm | F::R8G8B8A8UnormSrgb => per_element(src, dst, 4, |b| {
            Rgba::new(un8(b[0]), un8(b[1]), un8(b[2]), un8(b[3]))
        }),
        F::R8G8B8A8Uint => per_element(src, dst, 4, |b| {
            Rgba::new(
                f32::from(b[0]),
                f32::from(b[1]),
                f32::from(b[2]),
                f32::from(b[3]),
            )
        }),
        F::R8G8B8A8Snorm => per_element(src, dst, 4, |b| {
            Rgba::new(sn8(b[0]), sn8(b[1]), sn8(b[2]), sn8(b[3]))
        }),
        F::R8G8B8A8Sint => per_element(src, dst, 4, |b| {
            Rgba::new(
                f32::from(b[0] as i8),
                f32::from(b[1] as i8),
                f32::from(b[2] as i8),
                f32::from(b[3] as i8),
            )
        }),
        F::R16G16Float => per_element(src, dst, 4, |b| {
            Rgba::new(f16_to_f32(u16_le(b)), f16_to_f32(u16_le(&b[2..])), 0.0, 1.0)
        }),
        F::R16G16Unorm => per_element(src, dst, 4, |b| {
            Rgba::new(un16(u16_le(b)), un16(u16_le(&b[2..])), 0.0, 1.0)
        }),
        F::R16G16Uint => per_element(src, dst, 4, |b| {
            Rgba::new(f32::from(u16_le(b)), f32::from(u16_le(&b[2..])), 0.0, 1.0)
        }),
        F::R16G16Snorm => per_element(src, dst, 4, |b| {
            Rgba::new(sn16(u16_le(b)), sn16(u16_le(&b[2..])), 0.0, 1.0)
        }),
        F::R16G16Sint => per_element(src, dst, 4, |b| {
            Rgba::new(
                f32::from(u16_le(b) as i16),
                f32::from(u16_le(&b[2..]) as i16),
                0.0,
                1.0,
            )
        }),
        F::D32Float | F::R32Float => {
            per_element(src, dst, 4, |b| Rgba::new(f32_le(b), 0.0, 0.0, 1.0))
        }
        F::R32Uint => per_element(src, dst, 4, |b| Rgba::new(u32_le(b) as f32, 0.0, 0.0, 1.0)),
        F::R32Sint => {
            per_element(src, dst, 4, |b| Rgba::new(u32_le(b) as i32 as f32, 0.0, 0.0, 1.0))
        }
        F::D24UnormS8Uint => per_element(src, dst, 4, |b| {
            let v = u32_le(b);
            Rgba::new(
                (v & 0x00ff_ffff) as f32 / 16_777_215.0,
                (v >> 24) as f32,
                0.0,
                1.0,
            )
        }),
        F::R24UnormX8Typeless => per_element(src, dst, 4, |b| {
            Rgba::new((u32_le(b) & 0x00ff_ffff) as f32 / 16_777_215.0, 0.0, 0.0, 1.0)
        }),
        F::X24TypelessG8Uint => per_element(src, dst, 4, |b| {
            Rgba::new(0.0, (u32_le(b) >> 24) as f32, 0.0, 1.0)
        }),
        F::R8G8Unorm => per_element(src, dst, 2, |b| Rgba::new(un8(b[0]), un8(b[1]), 0.0, 1.0)),
        F::R8G8Uint => per_element(src, dst, 2, |b| {
            Rgba::new(f32::from(b[0]), f32::from(b[1]), 0.0, 1.0)
        }),
        F::R8G8Snorm => per_element(src, dst, 2, |b| Rgba::new(sn8(b[0]), sn8(b[1]), 0.0, 1.0)),
        F::R8G8Sint => per_element(src, dst, 2, |b| {
            Rgba::new(f32::from(b[0] as i8), f32::from(b[1] as i8), 0.0, 1.0)
        }),
        F::R16Float => per_element(src, dst, 2, |b| {
            Rgba::new(f16_to_f32(u16_le(b)), 0.0, 0.0, 1.0)
        }),
        F::D16Unorm | F::R16Unorm => {
            per_element(src, dst, 2, |b| Rgba::new(un16(u16_le(b)), 0.0, 0.0, 1.0))
        }
        F::R16Uint => per_element(src, dst, 2, |b| {
            Rgba::new(f32::from(u16_le(b)), 0.0, 0.0, 1.0)
        }),
        F::R16Snorm => per_element(src, dst, 2, |b| Rgba::new(sn16(u16_le(b)), 0.0, 0.0, 1.0)),
        F::R16Sint => per_element(src, dst, 2, |b| {
            Rgba::new(f32::from(u16_le(b) as i16), 0.0, 0.0, 1.0)
        }),
        F::R8Unorm => per_element(src, dst, 1, |b| Rgba::new(un8(b[0]), 0.0, 0.0, 1.0)),
        F::R8Uint => per_element(src, dst, 1, |b| Rgba::new(f32::from(b[0]), 0.0, 0.0, 1.0)),
        F::R8Snorm => per_element(src, dst, 1, |b| Rgba::new(sn8(b[0]), 0.0, 0.0, 1.0)),
        F::R8Sint => per_element(src, dst, 1, |b| {
            Rgba::new(f32::from(b[0] as i8), 0.0, 0.0, 1.0)
        }),
        F::A8Unorm => per_element(src, dst, 1, |b| Rgba::new(0.0, 0.0, 0.0, un8(b[0]))),
        F::R1Unorm => {
            if src.len() * 8 < dst.len() {
                return false;
            }
            for (i, d) in dst.iter_mut().enumerate() {
                let bit = (src[i >> 3] >> (i & 7)) & 1;
                *d = Rgba::new(f32::from(bit), 0.0, 0.0, 1.0);
            }
            true
        }
        F::R9G9B9E5SharedExp => per_element(src, dst, 4, |b| {
            let (r, g, bl) = unpack_rgb9e5(u32_le(b));
            Rgba::new(r, g, bl, 1.0)
        }),
        F::R8G8B8G8Unorm => per_element_pair(src, dst, 4, |b| {
            // [R, G0, B, G1]: chroma shared, luma per pixel.
            let r = un8(b[0]);
            let bl = un8(b[2]);
            (
                Rgba::new(r, un8(b[1]), bl, 1.0),
                Rgba::new(r, un8(b[3]), bl, 1.0),
            )
        }),
        F::G8R8G8B8Unorm => per_element_pair(src, dst, 4, |b| {
            // [G0, R, G1, B].
            let r = un8(b[1]);
            let bl = un8(b[3]);
            (
                Rgba::new(r, un8(b[0]), bl, 1.0),
                Rgba::new(r, un8(b[2]), bl, 1.0),
            )
        }),
        F::B5G6R5Unorm => per_element(src, dst, 2, |b| {
            let v = u16_le(b);
            Rgba::new(
                f32::from((v >> 11) & 31) / 31.0,
                f32::from((v >> 5) & 63) / 63.0,
                f32::from(v & 31) / 31.0,
                1.0,
            )
        }),
        F::B5G5R5A1Unorm => per_element(src, dst, 2, |b| {
            let v = u16_le(b);
            Rgba::new(
                f32::from((v >> 10) & 31) / 31.0,
                f32::from((v >> 5) & 31) / 31.0,
                f32::from(v & 31) / 31.0,
                f32::from(v >> 15),
            )
        }),
        F::B4G4R4A4Unorm => per_element(src, dst, 2, |b| {
            let v = u16_le(b);
            Rgba::new(
                f32::from((v >> 8) & 15) / 15.0,
                f32::from((v >> 4) & 15) / 15.0,
                f32::from(v & 15) / 15.0,
                f32::from(v >> 12) / 15.0,
            )
        }),
        F::B8G8R8A8Unorm | F::B8G8R8A8UnormSrgb => per_element(src, dst, 4, |b| {
            Rgba::new(un8(b[2]), un8(b[1]), un8(b[0]), un8(b[3]))
        }),
        F::B8G8R8X8Unorm | F::B8G8R8X8UnormSrgb => per_element(src, dst, 4, |b| {
            Rgba::new(un8(b[2]), un8(b[1]), un8(b[0]), 1.0)
        }),
        F::Ayuv => per_element(src, dst, 4, |b| {
            let v = i32::from(b[0]) - 128;
            let u = i32::from(b[1]) - 128;
            let y = i32::from(b[2]) - 16;
            let (r, g, bl) = yuv8_to_rgb(y, u, v);
            Rgba::new(
                clamp_scale(r, 255),
                clamp_scale(g, 255),
                clamp_scale(bl, 255),
                un8(b[3]),
            )
        }),
        F::Y410 => per_element(src, dst, 4, |b| {
            let w = u32_le(b);
            let u = i64::from(w & 0x3ff) - 512;
            let y = i64::from((w >> 10) & 0x3ff) - 64;
            let v = i64::from((w >> 20) & 0x3ff) - 512;
            let (r, g, bl) = yuv10_to_rgb(y, u, v);
            Rgba::new(
                clamp_scale(r, 1023),
                clamp_scale(g, 1023),
                clamp_scale(bl, 1023),
                (w >> 30) as f32 / 3.0,
            )
        }),
        F::Y416 => per_element(src, dst, 8, |b| {
            let u = i64::from(u16_le(b)) - 32768;
            let y = i64::from(u16_le(&b[2..])) - 4096;
            let v = i64::from(u16_le(&b[4..])) - 32768;
            let (r, g, bl) = yuv16_to_rgb(y, u, v);
            Rgba::new(
                clamp_scale(r, 65535),
                clamp_scale(g, 65535),
                clamp_scale(bl, 65535),
                un16(u16_le(&b[6..])),
            )
        }),
        F::Yuy2 => per_element_pair(src, dst, 4, |b| {
            let y0 = i32::from(b[0]) - 16;
            let u = i32::from(b[1]) - 128;
            let y1 = i32::from(b[2]) - 16;
            let v = i32::from(b[3]) - 128;
            let (r0, g0, b0) = yuv8_to_rgb(y0, u, v);
            let (r1, g1, b1) = yuv8_to_rgb(y1, u, v);
            (
                Rgba::new(clamp_scale(r0, 255), clamp_scale(g0, 255), clamp_scale(b0, 255), 1.0),
                Rgba::new(clamp_scale(r1, 255), clamp_scale(g1, 255), clamp_scale(b1, 255), 1.0),
            )
        }),
        F::Y210 => per_element_pair(src, dst, 8, |b| {
            // Same as Y216 with the low 6 bits of each field zero.
            let y0 = i64::from(u16_le(b) >> 6) - 64;
            let u = i64::from(u16_le(&b[2..]) >> 6) - 512;
            let y1 = i64::from(u16_le(&b[4..]) >> 6) - 64;
            let v = i64::from(u16_le(&b[6..]) >> 6) - 512;
            let (r0, g0, b0) = yuv10_to_rgb(y0, u, v);
            let (r1, g1, b1) = yuv10_to_rgb(y1, u, v);
            (
                Rgba::new(
                    clamp_scale(r0, 1023),
                    clamp_scale(g0, 1023),
                    clamp_scale(b0, 1023),
                    1.0,
                ),
                Rgba::new(
                    clamp_scale(r1, 1023),
                    clamp_scale(g1, 1023),
                    clamp_scale(b1, 1023),
                    1.0,
                ),
            )
        }),
        F::Y216 => per_element_pair(src, dst, 8, |b| {
            let y0 = i64::from(u16_le(b)) - 4096;
            let u = i64::from(u16_le(&b[2..])) - 32768;
            let y1 = i64::from(u16_le(&b[4..])) - 4096;
            let v = i64::from(u16_le(&b[6..])) - 32768;
            let (r0, g0, b0) = yuv16_to_rgb(y0, u, v);
            let (r1, g1, b1) = yuv16_to_rgb(y1, u, v);
            (
                Rgba::new(
                    clamp_scale(r0, 65535),
                    clamp_scale(g0, 65535),
                    clamp_scale(b0, 65535),
                    1.0,
                ),
                Rgba::new(
                    clamp_scale(r1, 65535),
                    clamp_scale(g1, 65535),
                    clamp_scale(b1, 65535),
                    1.0,
                ),
            )
        }),
        F::R10G10B10_7e3A2Float => per_element(src, dst, 4, |b| {
            let v = u32_le(b);
            Rgba::new(
                f32_from_7e3(v & 0x3ff),
                f32_from_7e3((v >> 10) & 0x3ff),
                f32_from_7e3((v >> 20) & 0x3ff),
                (v >> 30) as f32 / 3.0,
            )
        }),
        F::R10G10B10_6e4A2Float => per_element(src, dst, 4, |b| {
            let v = u32_le(b);
            Rgba::new(
                f32_from_6e4(v & 0x3ff),
                f32_from_6e4((v >> 10) & 0x3ff),
                f32_from_6e4((v >> 20) & 0x3ff),
                (v >> 30) as f32 / 3.0,
            )
        }),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgba8_load() {
        let src = [255u8, 128, 0, 64];
        let mut dst = [Rgba::ZERO; 1];
        assert!(load_scanline(PixelFormat::R8G8B8A8Unorm, &src, &mut dst));
        assert_eq!(dst[0].r, 1.0);
        assert!((dst[0].g - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(dst[0].b, 0.0);
    }

    #[test]
    fn test_bgra8_swaps_channels() {
        let src = [10u8, 20, 30, 40];
        let mut dst = [Rgba::ZERO; 1];
        assert!(load_scanline(PixelFormat::B8G8R8A8Unorm, &src, &mut dst));
        assert!((dst[0].r - un8(30)).abs() < 1e-6);
        assert!((dst[0].b - un8(10)).abs() < 1e-6);
    }

    #[test]
    fn test_missing_alpha_defaults_to_one() {
        let src = 0.5f32.to_le_bytes();
        let mut dst = [Rgba::ZERO; 1];
        assert!(load_scanline(PixelFormat::R32Float, &src, &mut dst));
        assert_eq!(dst[0].a, 1.0);
        assert_eq!(dst[0].r, 0.5);
    }

    #[test]
    fn test_snorm_most_negative_clamps() {
        let src = [0x80u8, 0x80, 0x80, 0x80];
        let mut dst = [Rgba::ZERO; 1];
        assert!(load_scanline(PixelFormat::R8G8B8A8Snorm, &src, &mut dst));
        assert_eq!(dst[0].r, -1.0);
    }

    #[test]
    fn test_565_channel_placement() {
        let v: u16 = (31 << 11) | (0 << 5) | 15;
        let mut dst = [Rgba::ZERO; 1];
        assert!(load_scanline(PixelFormat::B5G6R5Unorm, &v.to_le_bytes(), &mut dst));
        assert_eq!(dst[0].r, 1.0);
        assert_eq!(dst[0].g, 0.0);
        assert!((dst[0].b - 15.0 / 31.0).abs() < 1e-6);
    }

    #[test]
    fn test_short_source_fails() {
        let src = [0u8; 3];
        let mut dst = [Rgba::ZERO; 1];
        assert!(!load_scanline(PixelFormat::R8G8B8A8Unorm, &src, &mut dst));
    }

    #[test]
    fn test_unsupported_format_fails() {
        let src = [0u8; 64];
        let mut dst = [Rgba::ZERO; 4];
        assert!(!load_scanline(PixelFormat::Nv12, &src, &mut dst));
        assert!(!load_scanline(PixelFormat::Bc1Unorm, &src, &mut dst));
    }

    #[test]
    fn test_yuy2_grey() {
        // Y=235 is reference white; U=V=128 is neutral chroma.
        let src = [235u8, 128, 16, 128];
        let mut dst = [Rgba::ZERO; 2];
        assert!(load_scanline(PixelFormat::Yuy2, &src, &mut dst));
        assert!(dst[0].r > 0.99 && dst[0].g > 0.99 && dst[0].b > 0.99);
        assert!(dst[1].r < 0.01 && dst[1].g < 0.01 && dst[1].b < 0.01);
    }

    #[test]
    fn test_depth_stencil_split() {
        let v: u32 = 0x00ff_ffff | (0x42 << 24);
        let mut dst = [Rgba::ZERO; 1];
        assert!(load_scanline(PixelFormat::D24UnormS8Uint, &v.to_le_bytes(), &mut dst));
        assert_eq!(dst[0].r, 1.0);
        assert_eq!(dst[0].g, f32::from(0x42u8));
    }
}
