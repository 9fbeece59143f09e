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

//! Scanline narrowing: canonical `Rgba` pixels into any supported
//! on-wire format, with optional dithering.
//!
//! The plain store rounds to nearest. The dither store offers two
//! modes: a fixed 4x4x4 ordered matrix whose offset is added before
//! rounding, and Floyd–Steinberg error diffusion with the 7/3/5/1
//! weights. Diffusion rows scan in boustrophedon order so forward and
//! reverse passes share one code path with a sign-flipped step; the
//! caller owns the error buffer, which must hold `width + 2` entries.

use super::packed::{f32_to_6e4, f32_to_7e3, pack_r11g11b10, pack_rgb9e5};
use crate::format::PixelFormat;
use crate::pixel::{f32_to_f16, Rgba};

#[inline]
fn un8(f: f32) -> u8 {
    (f.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[inline]
fn sn8(f: f32) -> u8 {
    ((f.clamp(-1.0, 1.0) * 127.0).round() as i8) as u8
}

#[inline]
fn un16(f: f32) -> u16 {
    (f.clamp(0.0, 1.0) * 65535.0).round() as u16
}

#[inline]
fn sn16(f: f32) -> u16 {
    ((f.clamp(-1.0, 1.0) * 32767.0).round() as i16) as u16
}

#[inline]
fn half(f: f32) -> [u8; 2] {
    f32_to_f16(f).to_le_bytes()
}

fn per_element(dst: &mut [u8], src: &[Rgba], bpp: usize, f: impl Fn(&mut [u8], Rgba)) -> bool {
    if dst.len() < src.len() * bpp {
        return false;
    }
    for (i, &p) in src.iter().enumerate() {
        f(&mut dst[i * bpp..(i + 1) * bpp], p);
    }
    true
}

fn per_element_pair(
    dst: &mut [u8],
    src: &[Rgba],
    bpp: usize,
    f: impl Fn(&mut [u8], Rgba, Rgba),
) -> bool {
    let pairs = src.len().div_ceil(2);
    if dst.len() < pairs * bpp {
        return false;
    }
    for (i, chunk) in src.chunks(2).enumerate() {
        let second = chunk.get(1).copied().unwrap_or(Rgba::ZERO);
        f(&mut dst[i * bpp..(i + 1) * bpp], chunk[0], second);
    }
    true
}

/// Forward BT.601-style matrix at 8 bits; returns `(y, u, v)` without
/// clamping.
#[inline]
fn rgb8_to_yuv(r: i32, g: i32, b: i32) -> (i32, i32, i32) {
    let y = ((66 * r + 129 * g + 25 * b + 128) >> 8) + 16;
    let u = ((-38 * r - 74 * g + 112 * b + 128) >> 8) + 128;
    let v = ((112 * r - 94 * g - 18 * b + 128) >> 8) + 128;
    (y, u, v)
}

#[inline]
fn rgb10_to_yuv(r: i64, g: i64, b: i64) -> (i32, i32, i32) {
    let y = ((16780 * r + 32942 * g + 6544 * b + 32768) >> 16) + 64;
    let u = ((-9683 * r - 19017 * g + 28700 * b + 32768) >> 16) + 512;
    let v = ((28700 * r - 24033 * g - 4667 * b + 32768) >> 16) + 512;
    (y as i32, u as i32, v as i32)
}

#[inline]
fn rgb16_to_yuv(r: i64, g: i64, b: i64) -> (i32, i32, i32) {
    let y = ((16763 * r + 32910 * g + 6537 * b + 32768) >> 16) + 4096;
    let u = ((-9674 * r - 18998 * g + 28672 * b + 32768) >> 16) + 32768;
    let v = ((28672 * r - 24010 * g - 4662 * b + 32768) >> 16) + 32768;
    (y as i32, u as i32, v as i32)
}

#[inline]
fn unorm_q(f: f32, max: f32) -> i32 {
    (f.clamp(0.0, 1.0) * max).round() as i32
}

/// Stores one row of canonical `Rgba` pixels into `format` bytes.
///
/// Returns `false` when the format is not supported by the scanline
/// codec or the destination does not cover `src.len()` pixels.
#[allow(clippy::too_many_lines)] // one arm per format family
pub fn store_scanline(format: PixelFormat, src: &[Rgba], dst: &mut [u8]) -> bool {
    use PixelFormat as F;
    match format {
        F::R32G32B32A32Float => per_element(dst, src, 16, |b, p| {
            b[0..4].copy_from_slice(&p.r.to_le_bytes());
            b[4..8].copy_from_slice(&p.g.to_le_bytes());
            b[8..12].copy_from_slice(&p.b.to_le_bytes());
            b[12..16].copy_from_slice(&p.a.to_le_bytes());
        }),
        F::R32G32B32A32Uint => per_element(dst, src, 16, |b, p| {
            b[0..4].copy_from_slice(&(p.r as u32).to_le_bytes());
            b[4..8].copy_from_slice(&(p.g as u32).to_le_bytes());
            b[8..12].copy_from_slice(&(p.b as u32).to_le_bytes());
            b[12..16].copy_from_slice(&(p.a as u32).to_le_bytes());
        }),
        F::R32G32B32A32Sint => per_element(dst, src, 16, |b, p| {
            b[0..4].copy_from_slice(&(p.r as i32).to_le_bytes());
            b[4..8].copy_from_slice(&(p.g as i32).to_le_bytes());
            b[8..12].copy_from_slice(&(p.b as i32).to_le_bytes());
            b[12..16].copy_from_slice(&(p.a as i32).to_le_bytes());
        }),
        F::R32G32B32Float => per_element(dst, src, 12, |b, p| {
            b[0..4].copy_from_slice(&p.r.to_le_bytes());
            b[4..8].copy_from_slice(&p.g.to_le_bytes());
            b[8..12].copy_from_slice(&p.b.to_le_bytes());
        }),
        F::R32G32B32Uint => per_element(dst, src, 12, |b, p| {
            b[0..4].copy_from_slice(&(p.r as u32).to_le_bytes());
            b[4..8].copy_from_slice(&(p.g as u32).to_le_bytes());
            b[8..12].copy_from_slice(&(p.b as u32).to_le_bytes());
        }),
        F::R32G32B32Sint => per_element(dst, src, 12, |b, p| {
            b[0..4].copy_from_slice(&(p.r as i32).to_le_bytes());
            b[4..8].copy_from_slice(&(p.g as i32).to_le_bytes());
            b[8..12].copy_from_slice(&(p.b as i32).to_le_bytes());
        }),
        F::R16G16B16A16Float => per_element(dst, src, 8, |b, p| {
            b[0..2].copy_from_slice(&half(p.r));
            b[2..4].copy_from_slice(&half(p.g));
            b[4..6].copy_from_slice(&half(p.b));
            b[6..8].copy_from_slice(&half(p.a));
        }),
        F::R16G16B16A16Unorm => per_element(dst, src, 8, |b, p| {
            b[0..2].copy_from_slice(&un16(p.r).to_le_bytes());
            b[2..4].copy_from_slice(&un16(p.g).to_le_bytes());
            b[4..6].copy_from_slice(&un16(p.b).to_le_bytes());
            b[6..8].copy_from_slice(&un16(p.a).to_le_bytes());
        }),
        F::R16G16B16A16Uint => per_element(dst, src, 8, |b, p| {
            b[0..2].copy_from_slice(&(p.r as u16).to_le_bytes());
            b[2..4].copy_from_slice(&(p.g as u16).to_le_bytes());
            b[4..6].copy_from_slice(&(p.b as u16).to_le_bytes());
            b[6..8].copy_from_slice(&(p.a as u16).to_le_bytes());
        }),
        F::R16G16B16A16Snorm => per_element(dst, src, 8, |b, p| {
            b[0..2].copy_from_slice(&sn16(p.r).to_le_bytes());
            b[2..4].copy_from_slice(&sn16(p.g).to_le_bytes());
            b[4..6].copy_from_slice(&sn16(p.b).to_le_bytes());
            b[6..8].copy_from_slice(&sn16(p.a).to_le_bytes());
        }),
        F::R16G16B16A16Sint => per_element(dst, src, 8, |b, p| {
            b[0..2].copy_from_slice(&(p.r as i16).to_le_bytes());
            b[2..4].copy_from_slice(&(p.g as i16).to_le_bytes());
            b[4..6].copy_from_slice(&(p.b as i16).to_le_bytes());
            b[6..8].copy_from_slice(&(p.a as i16).to_le_bytes());
        }),
        F::R32G32Float => per_element(dst, src, 8, |b, p| {
            b[0..4].copy_from_slice(&p.r.to_le_bytes());
            b[4..8].copy_from_slice(&p.g.to_le_bytes());
        }),
        F::R32G32Uint => per_element(dst, src, 8, |b, p| {
            b[0..4].copy_from_slice(&(p.r as u32).to_le_bytes());
            b[4..8].copy_from_slice(&(p.g as u32).to_le_bytes());
        }),
        F::R32G32Sint => per_element(dst, src, 8, |b, p| {
            b[0..4].copy_from_slice(&(p.r as i32).to_le_bytes());
            b[4..8].copy_from_slice(&(p.g as i32).to_le_bytes());
        }),
        F::D32FloatS8X24Uint => per_element(dst, src, 8, |b, p| {
            b[0..4].copy_from_slice(&p.r.clamp(0.0, 1.0).to_le_bytes());
            b[4..8].copy_from_slice(&(p.g.clamp(0.0, 255.0) as u32).to_le_bytes());
        }),
        F::R10G10B10A2Unorm => per_element(dst, src, 4, |b, p| {
            let v = (unorm_q(p.r, 1023.0) as u32)
                | ((unorm_q(p.g, 1023.0) as u32) << 10)
                | ((unorm_q(p.b, 1023.0) as u32) << 20)
                | ((unorm_q(p.a, 3.0) as u32) << 30);
            b.copy_from_slice(&v.to_le_bytes());
        }),
        F::R10G10B10XrBiasA2Unorm => per_element(dst, src, 4, |b, p| {
            // Inverse of the extended-range bias: q = f * 510 + 384.
            let xr = |f: f32| {
                ((f.clamp(-0.7529, 1.2529) * 510.0 + 384.0).round() as i32).clamp(0, 1023) as u32
            };
            let v = xr(p.r)
                | (xr(p.g) << 10)
                | (xr(p.b) << 20)
                | ((unorm_q(p.a, 3.0) as u32) << 30);
            b.copy_from_slice(&v.to_le_bytes());
        }),
        F::R10G10B10A2Uint => per_element(dst, src, 4, |b, p| {
            let q = |f: f32| (f.clamp(0.0, 1023.0) as u32) & 0x3ff;
            let v = q(p.r)
                | (q(p.g) << 10)
                | (q(p.b) << 20)
                | (((p.a.clamp(0.0, 3.0) as u32) & 3) << 30);
            b.copy_from_slice(&v.to_le_bytes());
        }),
        F::R11G11B10Float => per_element(dst, src, 4, |b, p| {
            b.copy_from_slice(&pack_r11g11b10(p.r, p.g, p.b).to_le_bytes());
        }),
        F::R8G8B8A8Unorm | F::R8G8B8A8UnormSrgb => per_element(dst, src, 4, |b, p| {
            b[0] = un8(p.r);
            b[1] = un8(p.g);
            b[2] = un8(p.b);
            b[3] = un8(p.a);
        }),
        F::R8G8B8A8Uint => per_element(dst, src, 4, |b, p| {
            b[0] = p.r.clamp(0.0, 255.0) as u8;
            b[1] = p.g.clamp(0.0, 255.0) as u8;
            b[2] = p.b.clamp(0.0, 255.0) as u8;
            b[3] = p.a.clamp(0.0, 255.0) as u8;
        }),
        F::R8G8B8A8Snorm => per_element(dst, src, 4, |b, p| {
            b[0] = sn8(p.r);
            b[1] = sn8(p.g);
            b[2] = sn8(p.b);
            b[3] = sn8(p.a);
        }),
        F::R8G8B8A8Sint => per_element(dst, src, 4, |b, p| {
            b[0] = (p.r.clamp(-128.0, 127.0) as i8) as u8;
            b[1] = (p.g.clamp(-128.0, 127.0) as i8) as u8;
            b[2] = (p.b.clamp(-128.0, 127.0) as i8) as u8;
            b[3] = (p.a.clamp(-128.0, 127.0) as i8) as u8;
        }),
        F::R16G16Float => per_element(dst, src, 4, |b, p| {
            b[0..2].copy_from_slice(&half(p.r));
            b[2..4].copy_from_slice(&half(p.g));
        }),
        F::R16G16Unorm => per_element(dst, src, 4, |b, p| {
            b[0..2].copy_from_slice(&un16(p.r).to_le_bytes());
            b[2..4].copy_from_slice(&un16(p.g).to_le_bytes());
        }),
        F::R16G16Uint => per_element(dst, src, 4, |b, p| {
            b[0..2].copy_from_slice(&(p.r as u16).to_le_bytes());
            b[2..4].copy_from_slice(&(p.g as u16).to_le_bytes());
        }),
        F::R16G16Snorm => per_element(dst, src, 4, |b, p| {
            b[0..2].copy_from_slice(&sn16(p.r).to_le_bytes());
            b[2..4].copy_from_slice(&sn16(p.g).to_le_bytes());
        }),
        F::R16G16Sint => per_element(dst, src, 4, |b, p| {
            b[0..2].copy_from_slice(&(p.r as i16).to_le_bytes());
            b[2..4].copy_from_slice(&(p.g as i16).to_le_bytes());
        }),
        F::D32Float | F::R32Float => per_element(dst, src, 4, |b, p| {
            b.copy_from_slice(&p.r.to_le_bytes());
        }),
        F::R32Uint => per_element(dst, src, 4, |b, p| {
            b.copy_from_slice(&(p.r as u32).to_le_bytes());
        }),
        F::R32Sint => per_element(dst, src, 4, |b, p| {
            b.copy_from_slice(&(p.r as i32).to_le_bytes());
        }),
        F::D24UnormS8Uint => per_element(dst, src, 4, |b, p| {
            let d = unorm_q(p.r, 16_777_215.0) as u32;
            let s = p.g.clamp(0.0, 255.0) as u32;
            b.copy_from_slice(&((d & 0x00ff_ffff) | (s << 24)).to_le_bytes());
        }),
        F::R8G8Unorm => per_element(dst, src, 2, |b, p| {
            b[0] = un8(p.r);
            b[1] = un8(p.g);
        }),
        F::R8G8Uint => per_element(dst, src, 2, |b, p| {
            b[0] = p.r.clamp(0.0, 255.0) as u8;
            b[1] = p.g.clamp(0.0, 255.0) as u8;
        }),
        F::R8G8Snorm => per_element(dst, src, 2, |b, p| {
            b[0] = sn8(p.r);
            b[1] = sn8(p.g);
        }),
        F::R8G8Sint => per_element(dst, src, 2, |b, p| {
            b[0] = (p.r.clamp(-128.0, 127.0) as i8) as u8;
            b[1] = (p.g.clamp(-128.0, 127.0) as i8) as u8;
        }),
        F::R16Float => per_element(dst, src, 2, |b, p| {
            b.copy_from_slice(&half(p.r));
        }),
        F::D16Unorm | F::R16Unorm => per_element(dst, src, 2, |b, p| {
            b.copy_from_slice(&un16(p.r).to_le_bytes());
        }),
        F::R16Uint => per_element(dst, src, 2, |b, p| {
            b.copy_from_slice(&(p.r as u16).to_le_bytes());
        }),
        F::R16Snorm => per_element(dst, src, 2, |b, p| {
            b.copy_from_slice(&sn16(p.r).to_le_bytes());
        }),
        F::R16Sint => per_element(dst, src, 2, |b, p| {
            b.copy_from_slice(&(p.r as i16).to_le_bytes());
        }),
        F::R8Unorm => per_element(dst, src, 1, |b, p| {
            b[0] = un8(p.r);
        }),
        F::R8Uint => per_element(dst, src, 1, |b, p| {
            b[0] = p.r.clamp(0.0, 255.0) as u8;
        }),
        F::R8Snorm => per_element(dst, src, 1, |b, p| {
            b[0] = sn8(p.r);
        }),
        F::R8Sint => per_element(dst, src, 1, |b, p| {
            b[0] = (p.r.clamp(-128.0, 127.0) as i8) as u8;
        }),
        F::A8Unorm => per_element(dst, src, 1, |b, p| {
            b[0] = un8(p.a);
        }),
        F::R1Unorm => {
            if dst.len() * 8 < src.len() {
                return false;
            }
            for b in dst.iter_mut().take(src.len().div_ceil(8)) {
                *b = 0;
            }
            for (i, p) in src.iter().enumerate() {
                if p.r >= 0.5 {
                    dst[i >> 3] |= 1 << (i & 7);
                }
            }
            true
        }
        F::R9G9B9E5SharedExp => per_element(dst, src, 4, |b, p| {
            b.copy_from_slice(&pack_rgb9e5(p.r, p.g, p.b).to_le_bytes());
        }),
        F::R8G8B8G8Unorm => per_element_pair(dst, src, 4, |b, p0, p1| {
            b[0] = un8(p0.r);
            b[1] = un8(p0.g);
            b[2] = un8(p0.b);
            b[3] = un8(p1.g);
        }),
        F::G8R8G8B8Unorm => per_element_pair(dst, src, 4, |b, p0, p1| {
            b[0] = un8(p0.g);
            b[1] = un8(p0.r);
            b[2] = un8(p1.g);
            b[3] = un8(p0.b);
        }),
        F::B5G6R5Unorm => per_element(dst, src, 2, |b, p| {
            let v = ((unorm_q(p.r, 31.0) as u16) << 11)
                | ((unorm_q(p.g, 63.0) as u16) << 5)
                | (unorm_q(p.b, 31.0) as u16);
            b.copy_from_slice(&v.to_le_bytes());
        }),
        F::B5G5R5A1Unorm => per_element(dst, src, 2, |b, p| {
            let v = ((unorm_q(p.r, 31.0) as u16) << 10)
                | ((unorm_q(p.g, 31.0) as u16) << 5)
                | (unorm_q(p.b, 31.0) as u16)
                | ((unorm_q(p.a, 1.0) as u16) << 15);
            b.copy_from_slice(&v.to_le_bytes());
        }),
        F::B4G4R4A4Unorm => per_element(dst, src, 2, |b, p| {
            let v = ((unorm_q(p.r, 15.0) as u16) << 8)
                | ((unorm_q(p.g, 15.0) as u16) << 4)
                | (unorm_q(p.b, 15.0) as u16)
                | ((unorm_q(p.a, 15.0) as u16) << 12);
            b.copy_from_slice(&v.to_le_bytes());
        }),
        F::B8G8R8A8Unorm | F::B8G8R8A8UnormSrgb => per_element(dst, src, 4, |b, p| {
            b[0] = un8(p.b);
            b[1] = un8(p.g);
            b[2] = un8(p.r);
            b[3] = un8(p.a);
        }),
        F::B8G8R8X8Unorm | F::B8G8R8X8UnormSrgb => per_element(dst, src, 4, |b, p| {
            b[0] = un8(p.b);
            b[1] = un8(p.g);
            b[2] = un8(p.r);
            b[3] = 0;
        }),
        F::Ayuv => per_element(dst, src, 4, |b, p| {
            let (y, u, v) = rgb8_to_yuv(
                i32::from(un8(p.r)),
                i32::from(un8(p.g)),
                i32::from(un8(p.b)),
            );
            b[0] = v.clamp(0, 255) as u8;
            b[1] = u.clamp(0, 255) as u8;
            b[2] = y.clamp(0, 255) as u8;
            b[3] = un8(p.a);
        }),
        F::Y410 => per_element(dst, src, 4, |b, p| {
            let (y, u, v) = rgb10_to_yuv(
                i64::from(unorm_q(p.r, 1023.0)),
                i64::from(unorm_q(p.g, 1023.0)),
                i64::from(unorm_q(p.b, 1023.0)),
            );
            let w = (u.clamp(0, 1023) as u32)
                | ((y.clamp(0, 1023) as u32) << 10)
                | ((v.clamp(0, 1023) as u32) << 20)
                | ((unorm_q(p.a, 3.0) as u32) << 30);
            b.copy_from_slice(&w.to_le_bytes());
        }),
        F::Y416 => per_element(dst, src, 8, |b, p| {
            let (y, u, v) = rgb16_to_yuv(
                i64::from(unorm_q(p.r, 65535.0)),
                i64::from(unorm_q(p.g, 65535.0)),
                i64::from(unorm_q(p.b, 65535.0)),
            );
            b[0..2].copy_from_slice(&(u.clamp(0, 65535) as u16).to_le_bytes());
            b[2..4].copy_from_slice(&(y.clamp(0, 65535) as u16).to_le_bytes());
            b[4..6].copy_from_slice(&(v.clamp(0, 65535) as u16).to_le_bytes());
            b[6..8].copy_from_slice(&un16(p.a).to_le_bytes());
        }),
        F::Yuy2 => per_element_pair(dst, src, 4, |b, p0, p1| {
            let (y0, u0, v0) = rgb8_to_yuv(
                i32::from(un8(p0.r)),
                i32::from(un8(p0.g)),
                i32::from(un8(p0.b)),
            );
            let (y1, u1, v1) = rgb8_to_yuv(
                i32::from(un8(p1.r)),
                i32::from(un8(p1.g)),
                i32::from(un8(p1.b)),
            );
            b[0] = y0.clamp(0, 255) as u8;
            b[1] = ((u0 + u1) >> 1).clamp(0, 255) as u8;
            b[2] = y1.clamp(0, 255) as u8;
            b[3] = ((v0 + v1) >> 1).clamp(0, 255) as u8;
        }),
        F::Y210 => per_element_pair(dst, src, 8, |b, p0, p1| {
            let (y0, u0, v0) = rgb10_to_yuv(
                i64::from(unorm_q(p0.r, 1023.0)),
                i64::from(unorm_q(p0.g, 1023.0)),
                i64::from(unorm_q(p0.b, 1023.0)),
            );
            let (y1, u1, v1) = rgb10_to_yuv(
                i64::from(unorm_q(p1.r, 1023.0)),
                i64::from(unorm_q(p1.g, 1023.0)),
                i64::from(unorm_q(p1.b, 1023.0)),
            );
            let pack = |v: i32| ((v.clamp(0, 1023) as u16) << 6).to_le_bytes();
            b[0..2].copy_from_slice(&pack(y0));
            b[2..4].copy_from_slice(&pack((u0 + u1) >> 1));
            b[4..6].copy_from_slice(&pack(y1));
            b[6..8].copy_from_slice(&pack((v0 + v1) >> 1));
        }),
        F::Y216 => per_element_pair(dst, src, 8, |b, p0, p1| {
            let (y0, u0, v0) = rgb16_to_yuv(
                i64::from(unorm_q(p0.r, 65535.0)),
                i64::from(unorm_q(p0.g, 65535.0)),
                i64::from(unorm_q(p0.b, 65535.0)),
            );
            let (y1, u1, v1) = rgb16_to_yuv(
                i64::from(unorm_q(p1.r, 65535.0)),
                i64::from(unorm_q(p1.g, 65535.0)),
                i64::from(unorm_q(p1.b, 65535.0)),
            );
            let pack = |v: i32| (v.clamp(0, 65535) as u16).to_le_bytes();
            b[0..2].copy_from_slice(&pack(y0));
            b[2..4].copy_from_slice(&pack((u0 + u1) >> 1));
            b[4..6].copy_from_slice(&pack(y1));
            b[6..8].copy_from_slice(&pack((v0 + v1) >> 1));
        }),
        F::R10G10B10_7e3A2Float => per_element(dst, src, 4, |b, p| {
            let v = f32_to_7e3(p.r)
                | (f32_to_7e3(p.g) << 10)
                | (f32_to_7e3(p.b) << 20)
                | ((unorm_q(p.a, 3.0) as u32) << 30);
            b.copy_from_slice(&v.to_le_bytes());
        }),
        F::R10G10B10_6e4A2Float => per_element(dst, src, 4, |b, p| {
            let v = f32_to_6e4(p.r)
                | (f32_to_6e4(p.g) << 10)
                | (f32_to_6e4(p.b) << 20)
                | ((unorm_q(p.a, 3.0) as u32) << 30);
            b.copy_from_slice(&v.to_le_bytes());
        }),
        _ => false,
    }
}

/// 4x4x4 ordered dithering matrix, indexed
/// `(z & 3) + (y & 3) * 8 + (x & 3)`.
#[rustfmt::skip]
static DITHER_MATRIX: [f32; 32] = [
    0.468750, -0.031250, 0.343750, -0.156250, 0.468750, -0.031250, 0.343750, -0.156250,
    -0.281250, 0.218750, -0.406250, 0.093750, -0.281250, 0.218750, -0.406250, 0.093750,
    0.281250, -0.218750, 0.406250, -0.093750, 0.281250, -0.218750, 0.406250, -0.093750,
    -0.468750, 0.031250, -0.343750, 0.156250, -0.468750, 0.031250, -0.343750, 0.156250,
];

#[inline]
fn clamp_each(v: Rgba, lo: Rgba, hi: Rgba) -> Rgba {
    Rgba::new(
        v.r.clamp(lo.r, hi.r),
        v.g.clamp(lo.g, hi.g),
        v.b.clamp(lo.b, hi.b),
        v.a.clamp(lo.a, hi.a),
    )
}

#[inline]
fn mul_each(v: Rgba, s: Rgba) -> Rgba {
    Rgba::new(v.r * s.r, v.g * s.g, v.b * s.b, v.a * s.a)
}

#[inline]
fn div_each(v: Rgba, s: Rgba) -> Rgba {
    Rgba::new(v.r / s.r, v.g / s.g, v.b / s.b, v.a / s.a)
}

#[inline]
fn round_each(v: Rgba) -> Rgba {
    Rgba::new(
        v.r.round_ties_even(),
        v.g.round_ties_even(),
        v.b.round_ties_even(),
        v.a.round_ties_even(),
    )
}

/// Runs the shared dither kernel over one row, handing each finished
/// pixel's quantized channel values to `write`.
#[allow(clippy::too_many_arguments)]
fn dither_row(
    src: &mut [Rgba],
    y: usize,
    z: usize,
    mut diffusion: Option<&mut [Rgba]>,
    scale: Rgba,
    clamp_zero: bool,
    norm: bool,
    bgr: bool,
    write: &mut dyn FnMut(usize, Rgba),
) {
    let count = src.len();
    let neg_lo = Rgba::new(
        -scale.r + 1.0,
        -scale.g + 1.0,
        -scale.b + 1.0,
        -scale.a + 1.0,
    );

    if let Some(err) = diffusion.as_deref_mut() {
        // Fold in the residuals diffused from the previous scanline,
        // then clear the buffer for this row's contributions.
        for (i, p) in src.iter_mut().enumerate() {
            *p += err[i + 1];
        }
        for e in err.iter_mut() {
            *e = Rgba::ZERO;
        }
    }

    let reverse = y & 1 != 0;
    let mut v_error = Rgba::ZERO;

    for i in 0..count {
        let index = if reverse { count - 1 - i } else { i };
        let delta: isize = if reverse { -2 } else { 0 };

        let mut v = src[index];
        if bgr {
            std::mem::swap(&mut v.r, &mut v.b);
        }
        v = if norm && clamp_zero {
            v.clamp(0.0, 1.0)
        } else if clamp_zero {
            clamp_each(v, Rgba::ZERO, scale)
        } else if norm {
            v.clamp(-1.0, 1.0)
        } else {
            clamp_each(v, neg_lo, scale)
        };
        v += v_error;
        if norm {
            v = mul_each(v, scale);
        }

        let target = if let Some(err) = diffusion.as_deref_mut() {
            let t = round_each(v);
            let mut e = t;
            e = Rgba::new(v.r - e.r, v.g - e.g, v.b - e.b, v.a - e.a);
            if norm {
                e = div_each(e, scale);
            }
            let base = index as isize;
            err[(base - delta) as usize] += e * (3.0 / 16.0);
            err[(base + 1) as usize] += e * (5.0 / 16.0);
            err[(base + 2 + delta) as usize] += e * (1.0 / 16.0);
            v_error = e * (7.0 / 16.0);
            t
        } else {
            let d = DITHER_MATRIX[(z & 3) + (y & 3) * 8 + (index & 3)];
            round_each(v + Rgba::new(d, d, d, d))
        };

        let lo = if clamp_zero { Rgba::ZERO } else { neg_lo };
        let t = clamp_each(target, lo, scale);
        write(index, t);
    }
}

/// Stores one row with dithering.
///
/// With `diffusion` present this is Floyd–Steinberg error diffusion;
/// the buffer carries residuals between rows and must hold
/// `src.len() + 2` entries. Without it, the ordered matrix offset for
/// row `y` of slice `z` is applied before rounding. The source row is
/// consumed destructively. Formats without a quantized integer layout
/// fall back to the plain store.
pub fn store_scanline_dither(
    format: PixelFormat,
    src: &mut [Rgba],
    dst: &mut [u8],
    y: usize,
    z: usize,
    diffusion: Option<&mut [Rgba]>,
) -> bool {
    use PixelFormat as F;

    if let Some(err) = diffusion.as_ref() {
        debug_assert!(err.len() >= src.len() + 2);
    }

    let count = src.len();
    match format {
        F::R16G16B16A16Unorm => {
            if dst.len() < count * 8 {
                return false;
            }
            let scale = Rgba::new(65535.0, 65535.0, 65535.0, 65535.0);
            dither_row(src, y, z, diffusion, scale, true, true, false, &mut |i, t| {
                let o = i * 8;
                dst[o..o + 2].copy_from_slice(&(t.r as u16).to_le_bytes());
                dst[o + 2..o + 4].copy_from_slice(&(t.g as u16).to_le_bytes());
                dst[o + 4..o + 6].copy_from_slice(&(t.b as u16).to_le_bytes());
                dst[o + 6..o + 8].copy_from_slice(&(t.a as u16).to_le_bytes());
            });
            true
        }
        F::R16G16B16A16Snorm => {
            if dst.len() < count * 8 {
                return false;
            }
            let scale = Rgba::new(32767.0, 32767.0, 32767.0, 32767.0);
            dither_row(src, y, z, diffusion, scale, false, true, false, &mut |i, t| {
                let o = i * 8;
                dst[o..o + 2].copy_from_slice(&(t.r as i16).to_le_bytes());
                dst[o + 2..o + 4].copy_from_slice(&(t.g as i16).to_le_bytes());
                dst[o + 4..o + 6].copy_from_slice(&(t.b as i16).to_le_bytes());
                dst[o + 6..o + 8].copy_from_slice(&(t.a as i16).to_le_bytes());
            });
            true
        }
        F::R10G10B10A2Unorm => {
            if dst.len() < count * 4 {
                return false;
            }
            let scale = Rgba::new(1023.0, 1023.0, 1023.0, 3.0);
            dither_row(src, y, z, diffusion, scale, true, true, false, &mut |i, t| {
                let v = (t.r as u32 & 0x3ff)
                    | ((t.g as u32 & 0x3ff) << 10)
                    | ((t.b as u32 & 0x3ff) << 20)
                    | ((t.a as u32 & 3) << 30);
                dst[i * 4..i * 4 + 4].copy_from_slice(&v.to_le_bytes());
            });
            true
        }
        F::R10G10B10XrBiasA2Unorm => {
            if dst.len() < count * 4 {
                return false;
            }
            // The XR path scales and biases outside the shared kernel's
            // norm handling.
            let count = src.len();
            let mut diffusion = diffusion;
            if let Some(err) = diffusion.as_deref_mut() {
                for (i, p) in src.iter_mut().enumerate() {
                    *p += err[i + 1];
                }
                for e in err.iter_mut() {
                    *e = Rgba::ZERO;
                }
            }
            let reverse = y & 1 != 0;
            let scale = Rgba::new(510.0, 510.0, 510.0, 3.0);
            let bias = Rgba::new(384.0, 384.0, 384.0, 0.0);
            let mut v_error = Rgba::ZERO;
            for i in 0..count {
                let index = if reverse { count - 1 - i } else { i };
                let delta: isize = if reverse { -2 } else { 0 };

                let p = src[index];
                let v = Rgba::new(
                    p.r.clamp(-0.7529, 1.2529),
                    p.g.clamp(-0.7529, 1.2529),
                    p.b.clamp(-0.7529, 1.2529),
                    p.a.clamp(0.0, 1.0),
                );
                let v = mul_each(v, scale) + v_error;

                let target = if let Some(err) = diffusion.as_deref_mut() {
                    let t = round_each(v);
                    let mut e = Rgba::new(v.r - t.r, v.g - t.g, v.b - t.b, v.a - t.a);
                    e = div_each(e, scale);
                    let base = index as isize;
                    err[(base - delta) as usize] += e * (3.0 / 16.0);
                    err[(base + 1) as usize] += e * (5.0 / 16.0);
                    err[(base + 2 + delta) as usize] += e * (1.0 / 16.0);
                    v_error = mul_each(e * (7.0 / 16.0), scale);
                    t
                } else {
                    let d = DITHER_MATRIX[(z & 3) + (y & 3) * 8 + (index & 3)];
                    round_each(v + Rgba::new(d, d, d, d))
                };

                let t = clamp_each(
                    target + bias,
                    Rgba::ZERO,
                    Rgba::new(1023.0, 1023.0, 1023.0, 3.0),
                );
                let w = (t.r as u32 & 0x3ff)
                    | ((t.g as u32 & 0x3ff) << 10)
                    | ((t.b as u32 & 0x3ff) << 20)
                    | ((t.a as u32 & 3) << 30);
                dst[index * 4..index * 4 + 4].copy_from_slice(&w.to_le_bytes());
            }
            true
        }
        F::R8G8B8A8Unorm | F::R8G8B8A8UnormSrgb => {
            if dst.len() < count * 4 {
                return false;
            }
            let scale = Rgba::new(255.0, 255.0, 255.0, 255.0);
            dither_row(src, y, z, diffusion, scale, true, true, false, &mut |i, t| {
                dst[i * 4] = t.r as u8;
                dst[i * 4 + 1] = t.g as u8;
                dst[i * 4 + 2] = t.b as u8;
                dst[i * 4 + 3] = t.a as u8;
            });
            true
        }
        F::R8G8B8A8Snorm => {
            if dst.len() < count * 4 {
                return false;
            }
            let scale = Rgba::new(127.0, 127.0, 127.0, 127.0);
            dither_row(src, y, z, diffusion, scale, false, true, false, &mut |i, t| {
                dst[i * 4] = (t.r as i8) as u8;
                dst[i * 4 + 1] = (t.g as i8) as u8;
                dst[i * 4 + 2] = (t.b as i8) as u8;
                dst[i * 4 + 3] = (t.a as i8) as u8;
            });
            true
        }
        F::B8G8R8A8Unorm | F::B8G8R8A8UnormSrgb => {
            if dst.len() < count * 4 {
                return false;
            }
            let scale = Rgba::new(255.0, 255.0, 255.0, 255.0);
            dither_row(src, y, z, diffusion, scale, true, true, true, &mut |i, t| {
                // The kernel already swapped into BGR order.
                dst[i * 4] = t.r as u8;
                dst[i * 4 + 1] = t.g as u8;
                dst[i * 4 + 2] = t.b as u8;
                dst[i * 4 + 3] = t.a as u8;
            });
            true
        }
        F::B8G8R8X8Unorm | F::B8G8R8X8UnormSrgb => {
            if dst.len() < count * 4 {
                return false;
            }
            let scale = Rgba::new(255.0, 255.0, 255.0, 255.0);
            dither_row(src, y, z, diffusion, scale, true, true, true, &mut |i, t| {
                dst[i * 4] = t.r as u8;
                dst[i * 4 + 1] = t.g as u8;
                dst[i * 4 + 2] = t.b as u8;
                dst[i * 4 + 3] = 0;
            });
            true
        }
        F::B5G6R5Unorm => {
            if dst.len() < count * 2 {
                return false;
            }
            let scale = Rgba::new(31.0, 63.0, 31.0, 1.0);
            dither_row(src, y, z, diffusion, scale, true, true, true, &mut |i, t| {
                // Kernel output is (b, g, r) after the swap.
                let v = ((t.b as u16 & 31) << 11) | ((t.g as u16 & 63) << 5) | (t.r as u16 & 31);
                dst[i * 2..i * 2 + 2].copy_from_slice(&v.to_le_bytes());
            });
            true
        }
        F::B5G5R5A1Unorm => {
            if dst.len() < count * 2 {
                return false;
            }
            let scale = Rgba::new(31.0, 31.0, 31.0, 1.0);
            dither_row(src, y, z, diffusion, scale, true, true, true, &mut |i, t| {
                let v = ((t.b as u16 & 31) << 10)
                    | ((t.g as u16 & 31) << 5)
                    | (t.r as u16 & 31)
                    | ((t.a as u16 & 1) << 15);
                dst[i * 2..i * 2 + 2].copy_from_slice(&v.to_le_bytes());
            });
            true
        }
        F::B4G4R4A4Unorm => {
            if dst.len() < count * 2 {
                return false;
            }
            let scale = Rgba::new(15.0, 15.0, 15.0, 15.0);
            dither_row(src, y, z, diffusion, scale, true, true, true, &mut |i, t| {
                let v = ((t.b as u16 & 15) << 8)
                    | ((t.g as u16 & 15) << 4)
                    | (t.r as u16 & 15)
                    | ((t.a as u16 & 15) << 12);
                dst[i * 2..i * 2 + 2].copy_from_slice(&v.to_le_bytes());
            });
            true
        }
        F::A8Unorm => {
            if dst.len() < count {
                return false;
            }
            let scale = Rgba::new(255.0, 255.0, 255.0, 255.0);
            dither_row(src, y, z, diffusion, scale, true, true, false, &mut |i, t| {
                dst[i] = t.a as u8;
            });
            true
        }
        F::R8Unorm => {
            if dst.len() < count {
                return false;
            }
            let scale = Rgba::new(255.0, 255.0, 255.0, 255.0);
            dither_row(src, y, z, diffusion, scale, true, true, false, &mut |i, t| {
                dst[i] = t.r as u8;
            });
            true
        }
        _ => store_scanline(format, src, dst),
    }
}

#[cfg(test)]
mod tests {
    use super::super::load::load_scanline;
    use super::*;

    #[test]
    fn test_rgba8_store_rounds() {
        let src = [Rgba::new(0.5, 1.0, 0.0, 0.25)];
        let mut dst = [0u8; 4];
        assert!(store_scanline(PixelFormat::R8G8B8A8Unorm, &src, &mut dst));
        assert_eq!(dst, [128, 255, 0, 64]);
    }

    #[test]
    fn test_store_load_round_trip_various() {
        let formats = [
            (PixelFormat::R8G8B8A8Unorm, 4usize, 8u32),
            (PixelFormat::B8G8R8A8Unorm, 4, 8),
            (PixelFormat::R16G16B16A16Unorm, 8, 16),
            (PixelFormat::B5G6R5Unorm, 2, 5),
            (PixelFormat::B5G5R5A1Unorm, 2, 1),
            (PixelFormat::B4G4R4A4Unorm, 2, 4),
            (PixelFormat::R10G10B10A2Unorm, 4, 2),
            (PixelFormat::R16G16B16A16Float, 8, 10),
        ];
        let src = [
            Rgba::new(0.25, 0.5, 0.75, 1.0),
            Rgba::new(1.0, 0.0, 0.125, 0.5),
        ];
        for (format, bpp, prec) in formats {
            let mut bytes = vec![0u8; 2 * bpp];
            assert!(store_scanline(format, &src, &mut bytes), "{format:?}");
            let mut back = [Rgba::ZERO; 2];
            assert!(load_scanline(format, &bytes, &mut back), "{format:?}");
            let tol = 1.0 / f32::powi(2.0, prec as i32 - 1).max(2.0) + 1e-4;
            for (a, b) in src.iter().zip(back.iter()) {
                assert!((a.r - b.r).abs() <= tol, "{format:?} r: {} vs {}", a.r, b.r);
                assert!((a.g - b.g).abs() <= tol, "{format:?} g: {} vs {}", a.g, b.g);
                assert!((a.b - b.b).abs() <= tol, "{format:?} b: {} vs {}", a.b, b.b);
            }
        }
    }

    #[test]
    fn test_snorm_round_trip() {
        let src = [Rgba::new(-0.5, 0.5, -1.0, 1.0)];
        let mut bytes = [0u8; 4];
        assert!(store_scanline(PixelFormat::R8G8B8A8Snorm, &src, &mut bytes));
        let mut back = [Rgba::ZERO; 1];
        assert!(load_scanline(PixelFormat::R8G8B8A8Snorm, &bytes, &mut back));
        assert!((back[0].r + 0.5).abs() < 1.0 / 127.0);
        assert_eq!(back[0].b, -1.0);
        assert_eq!(back[0].a, 1.0);
    }

    #[test]
    fn test_nan_coerces_to_zero_in_integer_store() {
        let src = [Rgba::new(f32::NAN, 0.5, 0.5, 1.0)];
        let mut bytes = [0u8; 4];
        assert!(store_scanline(PixelFormat::R8G8B8A8Unorm, &src, &mut bytes));
        assert_eq!(bytes[0], 0);
    }

    #[test]
    fn test_xr_bias_round_trip() {
        let src = [Rgba::new(0.0, 1.0, -0.5, 1.0)];
        let mut bytes = [0u8; 4];
        assert!(store_scanline(PixelFormat::R10G10B10XrBiasA2Unorm, &src, &mut bytes));
        let mut back = [Rgba::ZERO; 1];
        assert!(load_scanline(PixelFormat::R10G10B10XrBiasA2Unorm, &bytes, &mut back));
        assert!((back[0].r).abs() < 1.0 / 510.0 + 1e-5);
        assert!((back[0].g - 1.0).abs() < 1.0 / 510.0 + 1e-5);
        assert!((back[0].b + 0.5).abs() < 1.0 / 510.0 + 1e-5);
    }

    #[test]
    fn test_yuy2_store_averages_chroma() {
        let src = [Rgba::new(1.0, 0.0, 0.0, 1.0), Rgba::new(1.0, 0.0, 0.0, 1.0)];
        let mut bytes = [0u8; 4];
        assert!(store_scanline(PixelFormat::Yuy2, &src, &mut bytes));
        let mut back = [Rgba::ZERO; 2];
        assert!(load_scanline(PixelFormat::Yuy2, &bytes, &mut back));
        for p in back {
            assert!((p.r - 1.0).abs() < 0.02, "r={}", p.r);
            assert!(p.g < 0.03 && p.b < 0.03);
        }
    }

    #[test]
    fn test_diffusion_conserves_average() {
        // A flat mid-grey between two 4-bit codes: diffusion should
        // alternate codes so the average stays close.
        let value = 0.5f32;
        let width = 64usize;
        let mut row = vec![Rgba::new(value, value, value, 1.0); width];
        let mut errors = vec![Rgba::ZERO; width + 2];
        let mut bytes = vec![0u8; width * 2];
        assert!(store_scanline_dither(
            PixelFormat::B4G4R4A4Unorm,
            &mut row,
            &mut bytes,
            0,
            0,
            Some(&mut errors),
        ));
        let mut back = vec![Rgba::ZERO; width];
        assert!(load_scanline(PixelFormat::B4G4R4A4Unorm, &bytes, &mut back));
        let mean: f32 = back.iter().map(|p| p.r).sum::<f32>() / width as f32;
        assert!((mean - value).abs() < 0.02, "mean {mean}");
    }

    #[test]
    fn test_ordered_dither_stays_within_one_code() {
        let width = 16usize;
        let mut row = vec![Rgba::new(0.3, 0.6, 0.9, 1.0); width];
        let mut bytes = vec![0u8; width * 4];
        assert!(store_scanline_dither(
            PixelFormat::R8G8B8A8Unorm,
            &mut row,
            &mut bytes,
            1,
            0,
            None,
        ));
        let mut back = vec![Rgba::ZERO; width];
        assert!(load_scanline(PixelFormat::R8G8B8A8Unorm, &bytes, &mut back));
        for p in &back {
            assert!((p.r - 0.3).abs() <= 1.5 / 255.0);
            assert!((p.g - 0.6).abs() <= 1.5 / 255.0);
            assert!((p.b - 0.9).abs() <= 1.5 / 255.0);
        }
    }
}
