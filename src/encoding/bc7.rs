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

//! BC7 block compression (LDR RGBA, 16 bytes per block).
//!
//! Eight modes trade off partition count, endpoint precision, index
//! width, optional shared low-order endpoint bits (P-bits), and a
//! channel rotation that swaps alpha with one colour channel before
//! encoding. The mode number is the position of the first set bit in
//! the block.
//!
//! The encoder enumerates mode, rotation, index-mode, and shape, ranks
//! shapes by a cheap error estimate, and refines the best quarter with
//! a per-channel perturbation search followed by a bounded exhaustive
//! search around the result. The emitted block is the lowest-error
//! candidate seen. A malformed block decodes to transparent black.

use super::{
    interpolate, interpolate_a, interpolate_rgb, is_fixup_offset, PARTITION_TABLE, FIXUP_TABLE,
};
use crate::bits::BitBuffer;
use crate::optimize::{optimize_rgb, optimize_rgba};
use crate::pixel::{LdrColor, LdrEndpoints, Rgba, BLOCK_PIXELS};
use log::debug;

const MAX_REGIONS: usize = 3;
const MAX_SHAPES: usize = 64;
const MAX_INDICES: usize = 16;
const NUM_CHANNELS: usize = 4;

/// Per-mode layout parameters.
struct ModeInfo {
    partitions: usize,
    partition_bits: usize,
    p_bits: usize,
    rotation_bits: usize,
    index_mode_bits: usize,
    index_prec: usize,
    index_prec2: usize,
    rgba_prec: LdrColor,
    rgba_prec_with_p: LdrColor,
}

const fn prec(r: u8, g: u8, b: u8, a: u8) -> LdrColor {
    LdrColor::new(r, g, b, a)
}

#[rustfmt::skip]
const MODE_INFO: [ModeInfo; 8] = [
    // Mode 0: colour only, 3 subsets, RGBP 4.4.4.1 (unique P-bit), 3-bit indices, 16 partitions
    ModeInfo { partitions: 2, partition_bits: 4, p_bits: 6, rotation_bits: 0, index_mode_bits: 0, index_prec: 3, index_prec2: 0, rgba_prec: prec(4, 4, 4, 0), rgba_prec_with_p: prec(5, 5, 5, 0) },
    // Mode 1: colour only, 2 subsets, RGBP 6.6.6.1 (shared P-bit), 3-bit indices
    ModeInfo { partitions: 1, partition_bits: 6, p_bits: 2, rotation_bits: 0, index_mode_bits: 0, index_prec: 3, index_prec2: 0, rgba_prec: prec(6, 6, 6, 0), rgba_prec_with_p: prec(7, 7, 7, 0) },
    // Mode 2: colour only, 3 subsets, RGB 5.5.5, 2-bit indices
    ModeInfo { partitions: 2, partition_bits: 6, p_bits: 0, rotation_bits: 0, index_mode_bits: 0, index_prec: 2, index_prec2: 0, rgba_prec: prec(5, 5, 5, 0), rgba_prec_with_p: prec(5, 5, 5, 0) },
    // Mode 3: colour only, 2 subsets, RGBP 7.7.7.1 (unique P-bit), 2-bit indices
    ModeInfo { partitions: 1, partition_bits: 6, p_bits: 4, rotation_bits: 0, index_mode_bits: 0, index_prec: 2, index_prec2: 0, rgba_prec: prec(7, 7, 7, 0), rgba_prec_with_p: prec(8, 8, 8, 0) },
    // Mode 4: separate alpha, 1 subset, RGB 5.5.5 A6, 2/3-bit indices, 2-bit rotation, index selector
    ModeInfo { partitions: 0, partition_bits: 0, p_bits: 0, rotation_bits: 2, index_mode_bits: 1, index_prec: 2, index_prec2: 3, rgba_prec: prec(5, 5, 5, 6), rgba_prec_with_p: prec(5, 5, 5, 6) },
    // Mode 5: separate alpha, 1 subset, RGB 7.7.7 A8, 2/2-bit indices, 2-bit rotation
    ModeInfo { partitions: 0, partition_bits: 0, p_bits: 0, rotation_bits: 2, index_mode_bits: 0, index_prec: 2, index_prec2: 2, rgba_prec: prec(7, 7, 7, 8), rgba_prec_with_p: prec(7, 7, 7, 8) },
    // Mode 6: combined alpha, 1 subset, RGBAP 7.7.7.7.1 (unique P-bit), 4-bit indices
    ModeInfo { partitions: 0, partition_bits: 0, p_bits: 2, rotation_bits: 0, index_mode_bits: 0, index_prec: 4, index_prec2: 0, rgba_prec: prec(7, 7, 7, 7), rgba_prec_with_p: prec(8, 8, 8, 8) },
    // Mode 7: combined alpha, 2 subsets, RGBAP 5.5.5.5.1 (unique P-bit), 2-bit indices
    ModeInfo { partitions: 1, partition_bits: 6, p_bits: 4, rotation_bits: 0, index_mode_bits: 0, index_prec: 2, index_prec2: 0, rgba_prec: prec(5, 5, 5, 5), rgba_prec_with_p: prec(6, 6, 6, 6) },
];

fn quantize_channel(comp: u8, prec: u8) -> u8 {
    debug_assert!(prec > 0 && prec <= 8);
    if prec == 8 {
        return comp;
    }
    let rnd = (u16::from(comp) + (1 << (7 - prec))).min(255) as u8;
    rnd >> (8 - prec)
}

fn quantize(c: LdrColor, prec: LdrColor) -> LdrColor {
    LdrColor::new(
        quantize_channel(c.r, prec.r),
        quantize_channel(c.g, prec.g),
        quantize_channel(c.b, prec.b),
        if prec.a > 0 {
            quantize_channel(c.a, prec.a)
        } else {
            255
        },
    )
}

fn unquantize_channel(comp: u8, prec: u8) -> u8 {
    debug_assert!(prec > 0 && prec <= 8);
    let comp = comp << (8 - prec);
    comp | (comp >> prec)
}

fn unquantize(c: LdrColor, prec: LdrColor) -> LdrColor {
    LdrColor::new(
        unquantize_channel(c.r, prec.r),
        unquantize_channel(c.g, prec.g),
        unquantize_channel(c.b, prec.b),
        if prec.a > 0 {
            unquantize_channel(c.a, prec.a)
        } else {
            255
        },
    )
}

fn error_sq(a: LdrColor, b: LdrColor, with_alpha: bool) -> f32 {
    let dr = f32::from(a.r) - f32::from(b.r);
    let dg = f32::from(a.g) - f32::from(b.g);
    let db = f32::from(a.b) - f32::from(b.b);
    let rgb = dr * dr + dg * dg + db * db;
    if with_alpha {
        let da = f32::from(a.a) - f32::from(b.a);
        rgb + da * da
    } else {
        rgb
    }
}

/// Error of one pixel against a palette, finding the best colour and
/// alpha indices. With `index_prec2 == 0` a single palette covers all
/// four channels; otherwise colour and alpha search independently.
fn compute_error(
    pixel: LdrColor,
    palette: &[LdrColor],
    index_prec: usize,
    index_prec2: usize,
    best_index: Option<&mut usize>,
    best_index2: Option<&mut usize>,
) -> f32 {
    let num_indices = 1usize << index_prec;
    let num_indices2 = 1usize << index_prec2;
    let mut total = 0.0f32;
    let mut local_best = 0usize;
    let mut local_best2 = 0usize;

    if index_prec2 == 0 {
        let mut best_err = f32::MAX;
        for (i, entry) in palette.iter().enumerate().take(num_indices) {
            if best_err <= 0.0 {
                break;
            }
            let err = error_sq(pixel, *entry, true);
            if err > best_err {
                // Palette entries march along the axis; error can only
                // increase from here.
                break;
            }
            if err < best_err {
                best_err = err;
                local_best = i;
            }
        }
        total += best_err;
    } else {
        let mut best_err = f32::MAX;
        for (i, entry) in palette.iter().enumerate().take(num_indices) {
            if best_err <= 0.0 {
                break;
            }
            let err = error_sq(pixel, *entry, false);
            if err > best_err {
                break;
            }
            if err < best_err {
                best_err = err;
                local_best = i;
            }
        }
        total += best_err;

        let mut best_err = f32::MAX;
        for (i, entry) in palette.iter().enumerate().take(num_indices2) {
            if best_err <= 0.0 {
                break;
            }
            let da = f32::from(pixel.a) - f32::from(entry.a);
            let err = da * da;
            if err > best_err {
                break;
            }
            if err < best_err {
                best_err = err;
                local_best2 = i;
            }
        }
        total += best_err;
    }

    if let Some(slot) = best_index {
        *slot = local_best;
    }
    if let Some(slot) = best_index2 {
        *slot = local_best2;
    }
    total
}

/// Decodes a BC7 block (16 bytes) to 16 pixels.
///
/// Reserved mode 8 and any malformed block decode to transparent black
/// for every pixel, as the format requires.
#[must_use]
pub fn decode_bc7(block: &[u8; 16]) -> [Rgba; BLOCK_PIXELS] {
    let buf = BitBuffer::from_bytes(*block);

    // The mode number is the position of the first set bit.
    let mut first = 0usize;
    while first < 128 && buf.get_bit(&mut first) == 0 {}
    let mode = first.wrapping_sub(1);

    if mode >= 8 {
        debug!("reserved BC7 mode in block");
        return [Rgba::ZERO; BLOCK_PIXELS];
    }

    let info = &MODE_INFO[mode];
    let partitions = info.partitions;
    let num_endpoints = (partitions + 1) << 1;
    let index_prec = info.index_prec;
    let index_prec2 = info.index_prec2;
    let mut cursor = mode + 1;

    let shape = buf.get_bits(&mut cursor, info.partition_bits) as usize;
    let rotation = buf.get_bits(&mut cursor, info.rotation_bits);
    let index_mode = buf.get_bits(&mut cursor, info.index_mode_bits);
    debug_assert!(shape < MAX_SHAPES && rotation < 4 && index_mode < 2);

    let rgba_prec = info.rgba_prec;
    let rgba_prec_with_p = info.rgba_prec_with_p;
    let mut c = [LdrColor::default(); MAX_REGIONS * 2];

    // Endpoint channels are grouped: all reds, all greens, blues, alphas.
    for ch in 0..NUM_CHANNELS {
        let bits = usize::from(rgba_prec[ch]);
        for ep in c.iter_mut().take(num_endpoints) {
            if cursor + bits > 128 {
                debug!("BC7 endpoint read past end of block");
                return [Rgba::ZERO; BLOCK_PIXELS];
            }
            ep[ch] = if ch == 3 && bits == 0 {
                255
            } else {
                buf.get_bits(&mut cursor, bits)
            };
        }
    }

    // P-bits broadcast into the low-order endpoint bits.
    debug_assert!(info.p_bits <= 6);
    let mut p = [0u8; 6];
    for slot in p.iter_mut().take(info.p_bits) {
        if cursor > 127 {
            debug!("BC7 P-bit read past end of block");
            return [Rgba::ZERO; BLOCK_PIXELS];
        }
        *slot = buf.get_bit(&mut cursor);
    }
    if info.p_bits > 0 {
        for (i, ep) in c.iter_mut().enumerate().take(num_endpoints) {
            let pi = i * info.p_bits / num_endpoints;
            for ch in 0..NUM_CHANNELS {
                if rgba_prec[ch] != rgba_prec_with_p[ch] {
                    ep[ch] = (ep[ch] << 1) | p[pi];
                }
            }
        }
    }

    for ep in c.iter_mut().take(num_endpoints) {
        *ep = unquantize(*ep, rgba_prec_with_p);
    }

    // Colour indices, then alpha indices when the mode has them.
    let mut w1 = [0u8; BLOCK_PIXELS];
    let mut w2 = [0u8; BLOCK_PIXELS];
    for (i, w) in w1.iter_mut().enumerate() {
        let bits = if is_fixup_offset(partitions, shape, i) {
            index_prec - 1
        } else {
            index_prec
        };
        if cursor + bits > 128 {
            debug!("BC7 index read past end of block");
            return [Rgba::ZERO; BLOCK_PIXELS];
        }
        *w = buf.get_bits(&mut cursor, bits);
    }
    if index_prec2 > 0 {
        for (i, w) in w2.iter_mut().enumerate() {
            let bits = if i == 0 { index_prec2 - 1 } else { index_prec2 };
            if cursor + bits > 128 {
                debug!("BC7 alpha index read past end of block");
                return [Rgba::ZERO; BLOCK_PIXELS];
            }
            *w = buf.get_bits(&mut cursor, bits);
        }
    }

    let mut out = [Rgba::ZERO; BLOCK_PIXELS];
    for i in 0..BLOCK_PIXELS {
        let region = usize::from(PARTITION_TABLE[partitions][shape][i]);
        let a = c[region << 1];
        let b = c[(region << 1) + 1];
        let mut pixel = if index_prec2 == 0 {
            interpolate(
                a,
                b,
                w1[i] as usize,
                w1[i] as usize,
                index_prec,
                index_prec,
            )
        } else if index_mode == 0 {
            interpolate(
                a,
                b,
                w1[i] as usize,
                w2[i] as usize,
                index_prec,
                index_prec2,
            )
        } else {
            interpolate(
                a,
                b,
                w2[i] as usize,
                w1[i] as usize,
                index_prec2,
                index_prec,
            )
        };

        match rotation {
            1 => std::mem::swap(&mut pixel.r, &mut pixel.a),
            2 => std::mem::swap(&mut pixel.g, &mut pixel.a),
            3 => std::mem::swap(&mut pixel.b, &mut pixel.a),
            _ => {}
        }

        out[i] = Rgba::from(pixel);
    }
    out
}

/// Per-call search context for one block encode.
struct Bc7Encoder<'a> {
    hdr_pixels: &'a [Rgba; BLOCK_PIXELS],
    pixels: [LdrColor; BLOCK_PIXELS],
    mode: usize,
    endpoints: [[LdrEndpoints; MAX_REGIONS]; MAX_SHAPES],
}

impl<'a> Bc7Encoder<'a> {
    fn new(hdr_pixels: &'a [Rgba; BLOCK_PIXELS]) -> Self {
        let mut pixels = [LdrColor::default(); BLOCK_PIXELS];
        for (ldr, hdr) in pixels.iter_mut().zip(hdr_pixels.iter()) {
            let clamp = |v: f32| (v * 255.0 + 0.01).clamp(0.0, 255.0) as u8;
            *ldr = LdrColor::new(clamp(hdr.r), clamp(hdr.g), clamp(hdr.b), clamp(hdr.a));
        }
        Self {
            hdr_pixels,
            pixels,
            mode: 0,
            endpoints: [[LdrEndpoints::default(); MAX_REGIONS]; MAX_SHAPES],
        }
    }

    fn info(&self) -> &'static ModeInfo {
        &MODE_INFO[self.mode]
    }

    fn index_precs(&self, index_mode: usize) -> (usize, usize) {
        let info = self.info();
        if index_mode != 0 {
            (info.index_prec2, info.index_prec)
        } else {
            (info.index_prec, info.index_prec2)
        }
    }

    fn generate_palette_quantized(
        &self,
        index_mode: usize,
        endpoints: &LdrEndpoints,
        palette: &mut [LdrColor; MAX_INDICES],
    ) {
        let (index_prec, index_prec2) = self.index_precs(index_mode);
        let num_indices = 1usize << index_prec;
        let num_indices2 = 1usize << index_prec2;
        let prec_with_p = self.info().rgba_prec_with_p;

        let a = unquantize(endpoints.a, prec_with_p);
        let b = unquantize(endpoints.b, prec_with_p);
        if index_prec2 == 0 {
            for (i, entry) in palette.iter_mut().enumerate().take(num_indices) {
                *entry = interpolate(a, b, i, i, index_prec, index_prec);
            }
        } else {
            for (i, entry) in palette.iter_mut().enumerate().take(num_indices) {
                let rgb = interpolate_rgb(a, b, i, index_prec);
                entry.r = rgb.r;
                entry.g = rgb.g;
                entry.b = rgb.b;
            }
            for (i, entry) in palette.iter_mut().enumerate().take(num_indices2) {
                entry.a = interpolate_a(a, b, i, index_prec2);
            }
        }
    }

    fn map_colors(
        &self,
        colors: &[LdrColor],
        index_mode: usize,
        endpoints: &LdrEndpoints,
        min_err: f32,
    ) -> f32 {
        let (index_prec, index_prec2) = self.index_precs(index_mode);
        let mut palette = [LdrColor::default(); MAX_INDICES];
        self.generate_palette_quantized(index_mode, endpoints, &mut palette);

        let mut total = 0.0f32;
        for &c in colors {
            total += compute_error(c, &palette, index_prec, index_prec2, None, None);
            if total > min_err {
                // Early exit once the candidate cannot win.
                return f32::MAX;
            }
        }
        total
    }

    fn perturb_one(
        &self,
        colors: &[LdrColor],
        index_mode: usize,
        ch: usize,
        old_endpoints: &LdrEndpoints,
        new_endpoints: &mut LdrEndpoints,
        old_err: f32,
        do_b: bool,
    ) -> f32 {
        let prec = i32::from(self.info().rgba_prec_with_p[ch]);
        let mut tmp = *old_endpoints;
        *new_endpoints = *old_endpoints;
        let mut min_err = old_err;

        let mut step = 1 << (prec - 1);
        while step != 0 {
            let mut improved = false;
            let mut best_step = 0i32;
            for sign in [-1i32, 1] {
                let base = i32::from(if do_b {
                    new_endpoints.b[ch]
                } else {
                    new_endpoints.a[ch]
                });
                let value = base + sign * step;
                if value < 0 || value >= (1 << prec) {
                    continue;
                }
                if do_b {
                    tmp.b[ch] = value as u8;
                } else {
                    tmp.a[ch] = value as u8;
                }

                let err = self.map_colors(colors, index_mode, &tmp, min_err);
                if err < min_err {
                    improved = true;
                    min_err = err;
                    best_step = sign * step;
                }
            }
            if improved {
                if do_b {
                    new_endpoints.b[ch] = (i32::from(new_endpoints.b[ch]) + best_step) as u8;
                } else {
                    new_endpoints.a[ch] = (i32::from(new_endpoints.a[ch]) + best_step) as u8;
                }
            }
            step >>= 1;
        }
        min_err
    }

    /// Bounded exhaustive search within +-5 of the current endpoints on
    /// one channel, preserving endpoint ordering.
    fn exhaustive(
        &self,
        colors: &[LdrColor],
        index_mode: usize,
        ch: usize,
        org_err: &mut f32,
        opt_endpoints: &mut LdrEndpoints,
    ) {
        if *org_err == 0.0 {
            return;
        }
        let prec = i32::from(self.info().rgba_prec_with_p[ch]);
        let delta = 5i32;

        let a = i32::from(opt_endpoints.a[ch]);
        let b = i32::from(opt_endpoints.b[ch]);
        let a_low = (a - delta).max(0);
        let a_high = (a + delta).min((1 << prec) - 1);
        let b_low = (b - delta).max(0);
        let b_high = (b + delta).min((1 << prec) - 1);

        let mut tmp = *opt_endpoints;
        let mut best_err = *org_err;
        let mut a_min = 0i32;
        let mut b_min = 0i32;

        if a <= b {
            for ta in a_low..=a_high {
                for tb in ta.max(b_low)..b_high {
                    tmp.a[ch] = ta as u8;
                    tmp.b[ch] = tb as u8;
                    let err = self.map_colors(colors, index_mode, &tmp, best_err);
                    if err < best_err {
                        a_min = ta;
                        b_min = tb;
                        best_err = err;
                    }
                }
            }
        } else {
            for tb in b_low..b_high {
                for ta in tb.max(a_low)..=a_high {
                    tmp.a[ch] = ta as u8;
                    tmp.b[ch] = tb as u8;
                    let err = self.map_colors(colors, index_mode, &tmp, best_err);
                    if err < best_err {
                        a_min = ta;
                        b_min = tb;
                        best_err = err;
                    }
                }
            }
        }

        if best_err < *org_err {
            opt_endpoints.a[ch] = a_min as u8;
            opt_endpoints.b[ch] = b_min as u8;
            *org_err = best_err;
        }
    }

    fn optimize_one(
        &self,
        colors: &[LdrColor],
        index_mode: usize,
        org_err: f32,
        org: &LdrEndpoints,
        opt: &mut LdrEndpoints,
    ) {
        let mut opt_err = org_err;
        *opt = *org;

        for ch in 0..NUM_CHANNELS {
            if self.info().rgba_prec_with_p[ch] == 0 {
                continue;
            }

            // Perturbing whichever endpoint helps most first avoids
            // settling into a local minimum when strictly alternating.
            let mut new_a = LdrEndpoints::default();
            let mut new_b = LdrEndpoints::default();
            let err0 = self.perturb_one(colors, index_mode, ch, opt, &mut new_a, opt_err, false);
            let err1 = self.perturb_one(colors, index_mode, ch, opt, &mut new_b, opt_err, true);

            let mut do_b;
            if err0 < err1 {
                if err0 >= opt_err {
                    continue;
                }
                opt.a[ch] = new_a.a[ch];
                opt_err = err0;
                do_b = true;
            } else {
                if err1 >= opt_err {
                    continue;
                }
                opt.b[ch] = new_b.b[ch];
                opt_err = err1;
                do_b = false;
            }

            loop {
                let mut new_ep = LdrEndpoints::default();
                let err =
                    self.perturb_one(colors, index_mode, ch, opt, &mut new_ep, opt_err, do_b);
                if err >= opt_err {
                    break;
                }
                if do_b {
                    opt.b[ch] = new_ep.b[ch];
                } else {
                    opt.a[ch] = new_ep.a[ch];
                }
                opt_err = err;
                do_b = !do_b;
            }
        }

        // Finish with a small exhaustive sweep around the minimum.
        for ch in 0..NUM_CHANNELS {
            if self.info().rgba_prec_with_p[ch] == 0 {
                continue;
            }
            self.exhaustive(colors, index_mode, ch, &mut opt_err, opt);
        }
    }

    fn optimize_endpoints(
        &self,
        shape: usize,
        index_mode: usize,
        org_err: &[f32; MAX_REGIONS],
        org: &[LdrEndpoints; MAX_REGIONS],
        opt: &mut [LdrEndpoints; MAX_REGIONS],
    ) {
        let partitions = self.info().partitions;
        let mut region_pixels = [LdrColor::default(); BLOCK_PIXELS];

        for p in 0..=partitions {
            let mut np = 0;
            for i in 0..BLOCK_PIXELS {
                if usize::from(PARTITION_TABLE[partitions][shape][i]) == p {
                    region_pixels[np] = self.pixels[i];
                    np += 1;
                }
            }
            self.optimize_one(&region_pixels[..np], index_mode, org_err[p], &org[p], &mut opt[p]);
        }
    }

    fn assign_indices(
        &self,
        shape: usize,
        index_mode: usize,
        endpoints: &mut [LdrEndpoints; MAX_REGIONS],
        indices: &mut [usize; BLOCK_PIXELS],
        indices2: &mut [usize; BLOCK_PIXELS],
        total_err: &mut [f32; MAX_REGIONS],
    ) {
        let info = self.info();
        let partitions = info.partitions;
        let (index_prec, index_prec2) = self.index_precs(index_mode);
        let num_indices = 1usize << index_prec;
        let num_indices2 = 1usize << index_prec2;
        let high_bit = num_indices >> 1;
        let high_bit2 = num_indices2 >> 1;

        let mut palette = [[LdrColor::default(); MAX_INDICES]; MAX_REGIONS];
        for p in 0..=partitions {
            self.generate_palette_quantized(index_mode, &endpoints[p], &mut palette[p]);
            total_err[p] = 0.0;
        }

        for i in 0..BLOCK_PIXELS {
            let region = usize::from(PARTITION_TABLE[partitions][shape][i]);
            total_err[region] += compute_error(
                self.pixels[i],
                &palette[region],
                index_prec,
                index_prec2,
                Some(&mut indices[i]),
                Some(&mut indices2[i]),
            );
        }

        // Swap endpoints as needed so the anchor index of each region
        // has a zero high-order bit.
        if index_prec2 == 0 {
            for p in 0..=partitions {
                if indices[usize::from(FIXUP_TABLE[partitions][shape][p])] & high_bit != 0 {
                    std::mem::swap(&mut endpoints[p].a, &mut endpoints[p].b);
                    for (j, idx) in indices.iter_mut().enumerate() {
                        if usize::from(PARTITION_TABLE[partitions][shape][j]) == p {
                            *idx = num_indices - 1 - *idx;
                        }
                    }
                }
            }
        } else {
            for p in 0..=partitions {
                if indices[usize::from(FIXUP_TABLE[partitions][shape][p])] & high_bit != 0 {
                    std::mem::swap(&mut endpoints[p].a.r, &mut endpoints[p].b.r);
                    std::mem::swap(&mut endpoints[p].a.g, &mut endpoints[p].b.g);
                    std::mem::swap(&mut endpoints[p].a.b, &mut endpoints[p].b.b);
                    for (j, idx) in indices.iter_mut().enumerate() {
                        if usize::from(PARTITION_TABLE[partitions][shape][j]) == p {
                            *idx = num_indices - 1 - *idx;
                        }
                    }
                }
                if indices2[0] & high_bit2 != 0 {
                    std::mem::swap(&mut endpoints[p].a.a, &mut endpoints[p].b.a);
                    for idx in indices2.iter_mut() {
                        *idx = num_indices2 - 1 - *idx;
                    }
                }
            }
        }
    }

    fn emit_block(
        &self,
        shape: usize,
        rotation: usize,
        index_mode: usize,
        endpoints: &[LdrEndpoints; MAX_REGIONS],
        indices: &[usize; BLOCK_PIXELS],
        indices2: &[usize; BLOCK_PIXELS],
    ) -> BitBuffer {
        let info = self.info();
        let partitions = info.partitions;
        let p_bits = info.p_bits;
        let index_prec = info.index_prec;
        let index_prec2 = info.index_prec2;
        let rgba_prec = info.rgba_prec;
        let rgba_prec_with_p = info.rgba_prec_with_p;

        let mut block = BitBuffer::new();
        let mut cursor = 0usize;
        block.set_bits(&mut cursor, self.mode, 0);
        block.set_bits(&mut cursor, 1, 1);
        block.set_bits(&mut cursor, info.rotation_bits, rotation as u8);
        block.set_bits(&mut cursor, info.index_mode_bits, index_mode as u8);
        block.set_bits(&mut cursor, info.partition_bits, shape as u8);

        if p_bits > 0 {
            let num_endpoints = (partitions + 1) << 1;
            let mut votes = [0u8; MAX_REGIONS * 2];
            let mut counts = [0u8; MAX_REGIONS * 2];
            for ch in 0..NUM_CHANNELS {
                let mut ep = 0usize;
                for i in 0..=partitions {
                    if rgba_prec[ch] == rgba_prec_with_p[ch] {
                        block.set_bits(&mut cursor, usize::from(rgba_prec[ch]), endpoints[i].a[ch]);
                        block.set_bits(&mut cursor, usize::from(rgba_prec[ch]), endpoints[i].b[ch]);
                    } else {
                        block.set_bits(
                            &mut cursor,
                            usize::from(rgba_prec[ch]),
                            endpoints[i].a[ch] >> 1,
                        );
                        block.set_bits(
                            &mut cursor,
                            usize::from(rgba_prec[ch]),
                            endpoints[i].b[ch] >> 1,
                        );
                        let idx = ep * p_bits / num_endpoints;
                        ep += 1;
                        votes[idx] += endpoints[i].a[ch] & 0x01;
                        counts[idx] += 1;
                        let idx = ep * p_bits / num_endpoints;
                        ep += 1;
                        votes[idx] += endpoints[i].b[ch] & 0x01;
                        counts[idx] += 1;
                    }
                }
            }
            // Each P-bit is the majority vote of the low-order bits it
            // replaces.
            for i in 0..p_bits {
                let bit = u8::from(votes[i] > (counts[i] >> 1));
                block.set_bits(&mut cursor, 1, bit);
            }
        } else {
            for ch in 0..NUM_CHANNELS {
                for i in 0..=partitions {
                    block.set_bits(&mut cursor, usize::from(rgba_prec[ch]), endpoints[i].a[ch]);
                    block.set_bits(&mut cursor, usize::from(rgba_prec[ch]), endpoints[i].b[ch]);
                }
            }
        }

        let (i1, i2): (&[usize; BLOCK_PIXELS], &[usize; BLOCK_PIXELS]) = if index_mode != 0 {
            (indices2, indices)
        } else {
            (indices, indices2)
        };
        for (i, &idx) in i1.iter().enumerate() {
            if is_fixup_offset(partitions, shape, i) {
                block.set_bits(&mut cursor, index_prec - 1, idx as u8);
            } else {
                block.set_bits(&mut cursor, index_prec, idx as u8);
            }
        }
        if index_prec2 > 0 {
            for (i, &idx) in i2.iter().enumerate() {
                let bits = if i == 0 { index_prec2 - 1 } else { index_prec2 };
                block.set_bits(&mut cursor, bits, idx as u8);
            }
        }

        debug_assert_eq!(cursor, 128);
        block
    }

    fn refine(&self, shape: usize, rotation: usize, index_mode: usize) -> (f32, BitBuffer) {
        let info = self.info();
        let partitions = info.partitions;
        let seeds = &self.endpoints[shape];

        let mut org_endpoints = [LdrEndpoints::default(); MAX_REGIONS];
        let mut opt_endpoints = [LdrEndpoints::default(); MAX_REGIONS];
        let mut org_idx = [0usize; BLOCK_PIXELS];
        let mut org_idx2 = [0usize; BLOCK_PIXELS];
        let mut opt_idx = [0usize; BLOCK_PIXELS];
        let mut opt_idx2 = [0usize; BLOCK_PIXELS];
        let mut org_err = [0.0f32; MAX_REGIONS];
        let mut opt_err = [0.0f32; MAX_REGIONS];

        for p in 0..=partitions {
            org_endpoints[p].a = quantize(seeds[p].a, info.rgba_prec_with_p);
            org_endpoints[p].b = quantize(seeds[p].b, info.rgba_prec_with_p);
        }

        self.assign_indices(
            shape,
            index_mode,
            &mut org_endpoints,
            &mut org_idx,
            &mut org_idx2,
            &mut org_err,
        );
        self.optimize_endpoints(shape, index_mode, &org_err, &org_endpoints, &mut opt_endpoints);
        self.assign_indices(
            shape,
            index_mode,
            &mut opt_endpoints,
            &mut opt_idx,
            &mut opt_idx2,
            &mut opt_err,
        );

        let org_total: f32 = org_err.iter().take(partitions + 1).sum();
        let opt_total: f32 = opt_err.iter().take(partitions + 1).sum();

        if opt_total < org_total {
            let block =
                self.emit_block(shape, rotation, index_mode, &opt_endpoints, &opt_idx, &opt_idx2);
            (opt_total, block)
        } else {
            let block =
                self.emit_block(shape, rotation, index_mode, &org_endpoints, &org_idx, &org_idx2);
            (org_total, block)
        }
    }

    /// Cheap error estimate for one shape; also seeds the per-shape
    /// endpoint pairs used by refinement.
    fn rough_mse(&mut self, shape: usize, index_mode: usize) -> f32 {
        let info = self.info();
        let partitions = info.partitions;
        let (index_prec, index_prec2) = self.index_precs(index_mode);
        let num_indices = 1usize << index_prec;
        let num_indices2 = 1usize << index_prec2;
        let mut pix_idx = [0usize; BLOCK_PIXELS];

        for p in 0..=partitions {
            let mut np = 0;
            for i in 0..BLOCK_PIXELS {
                if usize::from(PARTITION_TABLE[partitions][shape][i]) == p {
                    pix_idx[np] = i;
                    np += 1;
                }
            }

            debug_assert!(np > 0);
            if np == 1 {
                self.endpoints[shape][p].a = self.pixels[pix_idx[0]];
                self.endpoints[shape][p].b = self.pixels[pix_idx[0]];
                continue;
            }
            if np == 2 {
                self.endpoints[shape][p].a = self.pixels[pix_idx[0]];
                self.endpoints[shape][p].b = self.pixels[pix_idx[1]];
                continue;
            }

            if index_prec2 == 0 {
                let (ep_a, ep_b) = optimize_rgba(self.hdr_pixels, 4, &pix_idx[..np]);
                self.endpoints[shape][p].a = (ep_a.clamp(0.0, 1.0) * 255.0).to_ldr_scaled();
                self.endpoints[shape][p].b = (ep_b.clamp(0.0, 1.0) * 255.0).to_ldr_scaled();
            } else {
                let mut min_alpha = 255u8;
                let mut max_alpha = 0u8;
                for &pi in pix_idx.iter().take(np) {
                    min_alpha = min_alpha.min(self.pixels[pi].a);
                    max_alpha = max_alpha.max(self.pixels[pi].a);
                }

                let (ep_a, ep_b) = optimize_rgb(self.hdr_pixels, 4, &pix_idx[..np]);
                self.endpoints[shape][p].a = (ep_a.clamp(0.0, 1.0) * 255.0).to_ldr_scaled();
                self.endpoints[shape][p].b = (ep_b.clamp(0.0, 1.0) * 255.0).to_ldr_scaled();
                self.endpoints[shape][p].a.a = min_alpha;
                self.endpoints[shape][p].b.a = max_alpha;
            }
        }

        let mut palette = [[LdrColor::default(); MAX_INDICES]; MAX_REGIONS];
        for p in 0..=partitions {
            let ep = &self.endpoints[shape][p];
            if index_prec2 == 0 {
                for i in 0..num_indices {
                    palette[p][i] = interpolate(ep.a, ep.b, i, i, index_prec, index_prec);
                }
            } else {
                for i in 0..num_indices {
                    let rgb = interpolate_rgb(ep.a, ep.b, i, index_prec);
                    palette[p][i].r = rgb.r;
                    palette[p][i].g = rgb.g;
                    palette[p][i].b = rgb.b;
                }
                for i in 0..num_indices2 {
                    palette[p][i].a = interpolate_a(ep.a, ep.b, i, index_prec2);
                }
            }
        }

        let mut total = 0.0f32;
        for i in 0..BLOCK_PIXELS {
            let region = usize::from(PARTITION_TABLE[partitions][shape][i]);
            total += compute_error(
                self.pixels[i],
                &palette[region],
                index_prec,
                index_prec2,
                None,
                None,
            );
        }
        total
    }

    fn rotate(&mut self, rotation: usize) {
        match rotation {
            1 => {
                for p in &mut self.pixels {
                    std::mem::swap(&mut p.r, &mut p.a);
                }
            }
            2 => {
                for p in &mut self.pixels {
                    std::mem::swap(&mut p.g, &mut p.a);
                }
            }
            3 => {
                for p in &mut self.pixels {
                    std::mem::swap(&mut p.b, &mut p.a);
                }
            }
            _ => {}
        }
    }
}

/// Helper: scale an already 0-255 valued [`Rgba`] to [`LdrColor`].
trait ToLdrScaled {
    fn to_ldr_scaled(self) -> LdrColor;
}

impl ToLdrScaled for Rgba {
    fn to_ldr_scaled(self) -> LdrColor {
        LdrColor::new(
            (self.r + 0.001) as u8,
            (self.g + 0.001) as u8,
            (self.b + 0.001) as u8,
            (self.a + 0.001) as u8,
        )
    }
}

/// Encodes 16 pixels as a BC7 block (16 bytes).
///
/// The emitted block is the lowest-error candidate across all modes,
/// rotations, index modes, and refined shapes the search visits.
#[must_use]
pub fn encode_bc7(pixels: &[Rgba; BLOCK_PIXELS]) -> [u8; 16] {
    let mut enc = Bc7Encoder::new(pixels);
    let mut best_err = f32::MAX;
    let mut best_block = BitBuffer::new();

    for mode in 0..MODE_INFO.len() {
        if best_err <= 0.0 {
            break;
        }
        enc.mode = mode;
        let shapes = 1usize << MODE_INFO[mode].partition_bits;
        let num_rotations = 1usize << MODE_INFO[mode].rotation_bits;
        let num_index_modes = 1usize << MODE_INFO[mode].index_mode_bits;
        // Refining every shape is wasteful; the best quarter of the
        // rough estimates captures nearly all of the win.
        let items = (shapes >> 2).max(1);

        let mut rough = [0.0f32; MAX_SHAPES];
        let mut order = [0usize; MAX_SHAPES];

        for rotation in 0..num_rotations {
            if best_err <= 0.0 {
                break;
            }
            enc.rotate(rotation);

            for index_mode in 0..num_index_modes {
                if best_err <= 0.0 {
                    break;
                }

                for shape in 0..shapes {
                    rough[shape] = enc.rough_mse(shape, index_mode);
                    order[shape] = shape;
                }

                // Bubble the best `items` candidates to the front.
                for i in 0..items {
                    for j in (i + 1)..shapes {
                        if rough[i] > rough[j] {
                            rough.swap(i, j);
                            order.swap(i, j);
                        }
                    }
                }

                for &shape in order.iter().take(items) {
                    if best_err <= 0.0 {
                        break;
                    }
                    let (err, block) = enc.refine(shape, rotation, index_mode);
                    if err < best_err {
                        best_err = err;
                        best_block = block;
                    }
                }
            }

            // Undo the channel rotation for the next pass.
            enc.rotate(rotation);
        }
    }

    best_block.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantize_unquantize_extremes() {
        assert_eq!(quantize_channel(0, 5), 0);
        assert_eq!(quantize_channel(255, 5), 31);
        assert_eq!(unquantize_channel(0, 5), 0);
        assert_eq!(unquantize_channel(31, 5), 255);
        assert_eq!(unquantize_channel(255, 8), 255);
    }

    #[test]
    fn test_solid_grey_block() {
        let pixels = [Rgba::new(0.5, 0.5, 0.5, 1.0); 16];
        let block = encode_bc7(&pixels);
        let decoded = decode_bc7(&block);
        for p in decoded {
            assert!((p.r - 0.5).abs() <= 1.0 / 255.0 + 1e-6, "r={}", p.r);
            assert!((p.g - 0.5).abs() <= 1.0 / 255.0 + 1e-6);
            assert!((p.b - 0.5).abs() <= 1.0 / 255.0 + 1e-6);
            assert_eq!(p.a, 1.0);
        }
    }

    #[test]
    fn test_gradient_block_round_trip() {
        let mut pixels = [Rgba::ZERO; 16];
        for (i, p) in pixels.iter_mut().enumerate() {
            let t = i as f32 / 15.0;
            *p = Rgba::new(t, 1.0 - t, 0.25 + t * 0.5, 1.0);
        }
        let block = encode_bc7(&pixels);
        let decoded = decode_bc7(&block);
        for (i, p) in decoded.iter().enumerate() {
            assert!((p.r - pixels[i].r).abs() < 0.08, "pixel {i} r");
            assert!((p.g - pixels[i].g).abs() < 0.08, "pixel {i} g");
            assert!((p.b - pixels[i].b).abs() < 0.08, "pixel {i} b");
        }
    }

    #[test]
    fn test_alpha_gradient_round_trip() {
        let mut pixels = [Rgba::new(0.8, 0.2, 0.4, 0.0); 16];
        for (i, p) in pixels.iter_mut().enumerate() {
            p.a = i as f32 / 15.0;
        }
        let block = encode_bc7(&pixels);
        let decoded = decode_bc7(&block);
        for (i, p) in decoded.iter().enumerate() {
            assert!((p.a - pixels[i].a).abs() < 0.08, "pixel {i} a={}", p.a);
        }
    }

    #[test]
    fn test_reserved_mode_decodes_to_transparent_black() {
        // An all-zero block has no set mode bit.
        let decoded = decode_bc7(&[0u8; 16]);
        for p in decoded {
            assert_eq!((p.r, p.g, p.b, p.a), (0.0, 0.0, 0.0, 0.0));
        }
    }

    #[test]
    fn test_reencode_is_stable() {
        let pixels = [Rgba::new(0.5, 0.5, 0.5, 1.0); 16];
        let first = encode_bc7(&pixels);
        let second = encode_bc7(&decode_bc7(&first));
        assert_eq!(first, second);
    }

    #[test]
    fn test_mode_bit_is_first_set_bit() {
        let pixels = [Rgba::new(0.25, 0.5, 0.75, 1.0); 16];
        let block = encode_bc7(&pixels);
        // Some mode bit must be set within the first byte.
        assert_ne!(block[0] & 0x7f, 0, "mode prefix missing: {:02x}", block[0]);
    }
}
