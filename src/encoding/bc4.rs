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

//! BC4 and BC5 block compression (single and dual channel).
//!
//! A BC4 block stores two 8-bit endpoints and sixteen 3-bit indices in
//! the BC3 alpha layout. If `r0 > r1` the palette is an 8-entry linear
//! ramp; otherwise a 6-entry ramp plus the two range boundary values.
//! The signed variant stores two's-complement endpoints with `-128`
//! treated as `-127` to keep the ramp symmetric. BC5 is two
//! independent BC4 blocks covering the red and green channels.

use crate::optimize::optimize_alpha;
use crate::pixel::{Rgba, BLOCK_PIXELS};

/// Expands the 8-entry palette for unsigned endpoints.
#[must_use]
pub fn alpha_ramp_unsigned(r0: u8, r1: u8) -> [f32; 8] {
    let f0 = f32::from(r0) / 255.0;
    let f1 = f32::from(r1) / 255.0;
    let mut ramp = [0.0f32; 8];
    ramp[0] = f0;
    ramp[1] = f1;
    if r0 > r1 {
        for i in 2..8 {
            ramp[i] = (f0 * (8 - i) as f32 + f1 * (i - 1) as f32) / 7.0;
        }
    } else {
        for i in 2..6 {
            ramp[i] = (f0 * (6 - i) as f32 + f1 * (i - 1) as f32) / 5.0;
        }
        ramp[6] = 0.0;
        ramp[7] = 1.0;
    }
    ramp
}

/// Expands the 8-entry palette for signed endpoints.
#[must_use]
pub fn alpha_ramp_signed(r0: i8, r1: i8) -> [f32; 8] {
    // -128 has no positive counterpart; fold it onto -127.
    let s0 = if r0 == -128 { -127 } else { r0 };
    let s1 = if r1 == -128 { -127 } else { r1 };
    let f0 = f32::from(s0) / 127.0;
    let f1 = f32::from(s1) / 127.0;
    let mut ramp = [0.0f32; 8];
    ramp[0] = f0;
    ramp[1] = f1;
    if r0 > r1 {
        for i in 2..8 {
            ramp[i] = (f0 * (8 - i) as f32 + f1 * (i - 1) as f32) / 7.0;
        }
    } else {
        for i in 2..6 {
            ramp[i] = (f0 * (6 - i) as f32 + f1 * (i - 1) as f32) / 5.0;
        }
        ramp[6] = -1.0;
        ramp[7] = 1.0;
    }
    ramp
}

fn read_indices(block: &[u8; 8]) -> [usize; BLOCK_PIXELS] {
    let data = u64::from_le_bytes(*block);
    let mut out = [0usize; BLOCK_PIXELS];
    for (i, idx) in out.iter_mut().enumerate() {
        *idx = ((data >> (3 * i + 16)) & 0x7) as usize;
    }
    out
}

fn write_indices(block: &mut [u8; 8], indices: &[usize; BLOCK_PIXELS]) {
    let mut data = u64::from_le_bytes(*block);
    for (i, &idx) in indices.iter().enumerate() {
        data &= !(0x7u64 << (3 * i + 16));
        data |= (idx as u64) << (3 * i + 16);
    }
    *block = data.to_le_bytes();
}

/// Converts a float in `[-1, 1]` to an 8-bit SNORM value with
/// round-half-away-from-zero; NaN maps to 0.
fn float_to_snorm8(v: f32) -> i8 {
    let v = if v.is_nan() { 0.0 } else { v.clamp(-1.0, 1.0) };
    let scaled = v * 127.0;
    let rounded = if scaled >= 0.0 {
        scaled + 0.5
    } else {
        scaled - 0.5
    };
    rounded as i8
}

fn find_closest(values: &[f32; BLOCK_PIXELS], ramp: &[f32; 8]) -> [usize; BLOCK_PIXELS] {
    let mut out = [0usize; BLOCK_PIXELS];
    for (i, &v) in values.iter().enumerate() {
        let mut best = 0usize;
        let mut best_delta = f32::MAX;
        for (j, &r) in ramp.iter().enumerate() {
            let delta = (r - v).abs();
            if delta < best_delta {
                best = j;
                best_delta = delta;
            }
        }
        out[i] = best;
    }
    out
}

fn channel(pixels: &[Rgba; BLOCK_PIXELS], ch: usize) -> [f32; BLOCK_PIXELS] {
    let mut out = [0.0f32; BLOCK_PIXELS];
    for (o, p) in out.iter_mut().zip(pixels.iter()) {
        *o = p[ch];
    }
    out
}

fn encode_block_unsigned(values: &[f32; BLOCK_PIXELS]) -> [u8; 8] {
    let mut block_min = values[0];
    let mut block_max = values[0];
    for &v in values.iter() {
        if v < block_min {
            block_min = v;
        } else if v > block_max {
            block_max = v;
        }
    }

    // A boundary value in the block forces the 6-step codec so 0 and 1
    // are coded exactly by the pinned entries.
    let boundary = block_min == 0.0 || block_max == 1.0;
    let mut block = [0u8; 8];
    if boundary {
        let (start, end) = optimize_alpha(values, 6, false);
        block[0] = (start * 255.0) as u8;
        block[1] = (end * 255.0) as u8;
    } else {
        let (start, end) = optimize_alpha(values, 8, false);
        block[0] = (end * 255.0) as u8;
        block[1] = (start * 255.0) as u8;
    }

    let ramp = alpha_ramp_unsigned(block[0], block[1]);
    let indices = find_closest(values, &ramp);
    write_indices(&mut block, &indices);
    block
}

fn encode_block_signed(values: &[f32; BLOCK_PIXELS]) -> [u8; 8] {
    let mut block_min = values[0];
    let mut block_max = values[0];
    for &v in values.iter() {
        if v < block_min {
            block_min = v;
        } else if v > block_max {
            block_max = v;
        }
    }

    let boundary = block_min == -1.0 || block_max == 1.0;
    let mut block = [0u8; 8];
    let (e0, e1) = if boundary {
        let (start, end) = optimize_alpha(values, 6, true);
        (float_to_snorm8(start), float_to_snorm8(end))
    } else {
        let (start, end) = optimize_alpha(values, 8, true);
        (float_to_snorm8(end), float_to_snorm8(start))
    };
    block[0] = e0 as u8;
    block[1] = e1 as u8;

    let ramp = alpha_ramp_signed(e0, e1);
    let indices = find_closest(values, &ramp);
    write_indices(&mut block, &indices);
    block
}

fn decode_block(block: &[u8; 8], ramp: &[f32; 8]) -> [f32; BLOCK_PIXELS] {
    let indices = read_indices(block);
    let mut out = [0.0f32; BLOCK_PIXELS];
    for (o, &i) in out.iter_mut().zip(indices.iter()) {
        *o = ramp[i];
    }
    out
}

/// Decodes an unsigned BC4 block (8 bytes); the value lands in the red
/// channel with green and blue zero.
#[must_use]
pub fn decode_bc4u(block: &[u8; 8]) -> [Rgba; BLOCK_PIXELS] {
    let ramp = alpha_ramp_unsigned(block[0], block[1]);
    let values = decode_block(block, &ramp);
    let mut out = [Rgba::BLACK; BLOCK_PIXELS];
    for (o, v) in out.iter_mut().zip(values.iter()) {
        o.r = *v;
    }
    out
}

/// Decodes a signed BC4 block (8 bytes) into the `[-1, 1]` range.
#[must_use]
pub fn decode_bc4s(block: &[u8; 8]) -> [Rgba; BLOCK_PIXELS] {
    let ramp = alpha_ramp_signed(block[0] as i8, block[1] as i8);
    let values = decode_block(block, &ramp);
    let mut out = [Rgba::BLACK; BLOCK_PIXELS];
    for (o, v) in out.iter_mut().zip(values.iter()) {
        o.r = *v;
    }
    out
}

/// Encodes the red channel of 16 pixels as an unsigned BC4 block.
#[must_use]
pub fn encode_bc4u(pixels: &[Rgba; BLOCK_PIXELS]) -> [u8; 8] {
    encode_block_unsigned(&channel(pixels, 0))
}

/// Encodes the red channel of 16 pixels as a signed BC4 block.
#[must_use]
pub fn encode_bc4s(pixels: &[Rgba; BLOCK_PIXELS]) -> [u8; 8] {
    encode_block_signed(&channel(pixels, 0))
}

/// Decodes an unsigned BC5 block (16 bytes) into red and green.
#[must_use]
pub fn decode_bc5u(block: &[u8; 16]) -> [Rgba; BLOCK_PIXELS] {
    let r: &[u8; 8] = block[0..8].try_into().unwrap();
    let g: &[u8; 8] = block[8..16].try_into().unwrap();
    let rv = decode_block(r, &alpha_ramp_unsigned(r[0], r[1]));
    let gv = decode_block(g, &alpha_ramp_unsigned(g[0], g[1]));
    let mut out = [Rgba::BLACK; BLOCK_PIXELS];
    for i in 0..BLOCK_PIXELS {
        out[i].r = rv[i];
        out[i].g = gv[i];
    }
    out
}

/// Decodes a signed BC5 block (16 bytes) into red and green.
#[must_use]
pub fn decode_bc5s(block: &[u8; 16]) -> [Rgba; BLOCK_PIXELS] {
    let r: &[u8; 8] = block[0..8].try_into().unwrap();
    let g: &[u8; 8] = block[8..16].try_into().unwrap();
    let rv = decode_block(r, &alpha_ramp_signed(r[0] as i8, r[1] as i8));
    let gv = decode_block(g, &alpha_ramp_signed(g[0] as i8, g[1] as i8));
    let mut out = [Rgba::BLACK; BLOCK_PIXELS];
    for i in 0..BLOCK_PIXELS {
        out[i].r = rv[i];
        out[i].g = gv[i];
    }
    out
}

/// Encodes the red and green channels of 16 pixels as an unsigned BC5
/// block.
#[must_use]
pub fn encode_bc5u(pixels: &[Rgba; BLOCK_PIXELS]) -> [u8; 16] {
    let mut out = [0u8; 16];
    out[0..8].copy_from_slice(&encode_block_unsigned(&channel(pixels, 0)));
    out[8..16].copy_from_slice(&encode_block_unsigned(&channel(pixels, 1)));
    out
}

/// Encodes the red and green channels of 16 pixels as a signed BC5
/// block.
#[must_use]
pub fn encode_bc5s(pixels: &[Rgba; BLOCK_PIXELS]) -> [u8; 16] {
    let mut out = [0u8; 16];
    out[0..8].copy_from_slice(&encode_block_signed(&channel(pixels, 0)));
    out[8..16].copy_from_slice(&encode_block_signed(&channel(pixels, 1)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_from(values: [f32; 16]) -> [Rgba; 16] {
        let mut out = [Rgba::BLACK; 16];
        for (o, v) in out.iter_mut().zip(values.iter()) {
            o.r = *v;
        }
        out
    }

    #[test]
    fn test_bc4u_ramp_fidelity() {
        let mut values = [0.0f32; 16];
        for (i, v) in values.iter_mut().enumerate() {
            *v = 0.1 + 0.8 * i as f32 / 15.0;
        }
        let block = encode_bc4u(&block_from(values));
        let decoded = decode_bc4u(&block);
        for (i, p) in decoded.iter().enumerate() {
            assert!((p.r - values[i]).abs() < 0.08, "pixel {i}: {} vs {}", p.r, values[i]);
        }
    }

    #[test]
    fn test_bc4u_boundary_values_exact() {
        let mut values = [0.4f32; 16];
        values[3] = 0.0;
        values[9] = 1.0;
        let block = encode_bc4u(&block_from(values));
        // 6-step layout: r0 <= r1.
        assert!(block[0] <= block[1]);
        let decoded = decode_bc4u(&block);
        assert_eq!(decoded[3].r, 0.0);
        assert_eq!(decoded[9].r, 1.0);
    }

    #[test]
    fn test_bc4s_round_trip() {
        let mut values = [0.0f32; 16];
        for (i, v) in values.iter_mut().enumerate() {
            *v = -0.8 + 1.6 * i as f32 / 15.0;
        }
        let block = encode_bc4s(&block_from(values));
        let decoded = decode_bc4s(&block);
        for (i, p) in decoded.iter().enumerate() {
            assert!(
                (p.r - values[i]).abs() < 0.15,
                "pixel {i}: {} vs {}",
                p.r,
                values[i]
            );
        }
    }

    #[test]
    fn test_bc4s_minus_128_reads_as_minus_one() {
        // -128 endpoint must behave exactly like -127.
        let mut block = [0u8; 8];
        block[0] = (-128i8) as u8;
        block[1] = 127u8;
        let decoded = decode_bc4s(&block);
        assert_eq!(decoded[0].r, -1.0);
    }

    #[test]
    fn test_bc5u_channels_are_independent() {
        let mut pixels = [Rgba::BLACK; 16];
        for (i, p) in pixels.iter_mut().enumerate() {
            p.r = i as f32 / 15.0 * 0.5 + 0.2;
            p.g = 0.9 - i as f32 / 15.0 * 0.5;
        }
        let block = encode_bc5u(&pixels);
        let decoded = decode_bc5u(&block);
        for (i, p) in decoded.iter().enumerate() {
            assert!((p.r - pixels[i].r).abs() < 0.06, "red {i}");
            assert!((p.g - pixels[i].g).abs() < 0.06, "green {i}");
            assert_eq!(p.b, 0.0);
        }
    }

    #[test]
    fn test_bc5s_round_trip() {
        let mut pixels = [Rgba::BLACK; 16];
        for (i, p) in pixels.iter_mut().enumerate() {
            p.r = (i as f32 / 15.0) - 0.5;
            p.g = 0.5 - (i as f32 / 15.0);
        }
        let block = encode_bc5s(&pixels);
        let decoded = decode_bc5s(&block);
        for (i, p) in decoded.iter().enumerate() {
            assert!((p.r - pixels[i].r).abs() < 0.1, "red {i}");
            assert!((p.g - pixels[i].g).abs() < 0.1, "green {i}");
        }
    }
}
