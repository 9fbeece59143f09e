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

//! Whole-image format conversion.
//!
//! [`convert`] drives the scanline codec row by row: widen the source
//! row into canonical `Rgba`, apply the channel adjustments implied by
//! the difference between the two format descriptors (UNORM/SNORM
//! rescale, float saturation, channel broadcast, luminance), then
//! narrow into the destination with optional dithering. When either
//! side is a block-compressed format the row pipeline feeds
//! [`compress`] or [`decompress`] instead, which chop rows into 4x4
//! blocks for the BC codecs.
//!
//! A handful of bit-exact fast paths (straight copy, red/blue swizzle,
//! legacy 16-bit expansion, alpha fill) bypass the float pipeline when
//! no colour transform is requested; they produce the same bytes as
//! the general path within rounding.
//!
//! Planar sources (NV12, NV11, P010, P016) are first rebuilt into
//! their packed single-plane forms; this is a chroma reshuffle, not a
//! colour transform.

use crate::encoding::{bc1, bc4, bc6h, bc7, BcFlags};
use crate::error::{CodecError, Result};
use crate::format::{FormatFlags, PixelFormat};
use crate::pixel::{Rgba, BLOCK_PIXELS};
use crate::scanline::{
    copy_scanline, expand_scanline, linear_to_srgb, load_scanline, srgb_capable, srgb_to_linear,
    store_scanline, store_scanline_dither, swizzle_scanline,
};
use bitflags::bitflags;
use bytes::{BufMut, BytesMut};
use log::debug;

/// Luminance weights for the RGB-to-single-channel dot product.
const GRAYSCALE: Rgba = Rgba::new(0.2125, 0.7154, 0.0721, 0.0);

bitflags! {
    /// Options accepted by the converter layer.
    ///
    /// The ordinals are part of the external ABI and must not change.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ConvertFlags: u32 {
        /// Broadcast the red channel when narrowing RGB to fewer
        /// channels.
        const RGB_COPY_RED = 0x0000_1000;
        /// Broadcast the green channel when narrowing.
        const RGB_COPY_GREEN = 0x0000_2000;
        /// Broadcast the blue channel when narrowing.
        const RGB_COPY_BLUE = 0x0000_4000;
        /// Ordered (matrix) dithering on store.
        const DITHER = 0x0001_0000;
        /// Floyd–Steinberg error-diffusion dithering on store.
        const DITHER_DIFFUSION = 0x0002_0000;
        /// Treat the source as sRGB-encoded and linearise it.
        const SRGB_IN = 0x0100_0000;
        /// Encode the destination as sRGB.
        const SRGB_OUT = 0x0200_0000;
        /// Both sRGB directions.
        const SRGB = 0x0300_0000;
        /// Caller hint only; the core ignores it.
        const FORCE_WIC = 0x1000_0000;
        /// Caller hint only; the core ignores it.
        const FORCE_NON_WIC = 0x2000_0000;
    }
}

/// Options for [`convert`].
#[derive(Debug, Clone, Copy)]
pub struct ConvertOptions {
    /// Conversion flags.
    pub flags: ConvertFlags,
    /// Alpha threshold for formats with 1-bit alpha and the BC1
    /// transparent palette slot.
    pub threshold: f32,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            flags: ConvertFlags::empty(),
            threshold: 0.5,
        }
    }
}

/// A read-only view of an image in memory.
///
/// `row_pitch` may exceed the tightly packed row size to allow
/// padding. For BC formats a "row" is one row of 4x4 blocks.
#[derive(Debug, Clone, Copy)]
pub struct Image<'a> {
    /// Pixel format of the data.
    pub format: PixelFormat,
    /// Width in pixels.
    pub width: usize,
    /// Height in pixels.
    pub height: usize,
    /// Bytes from one row (or block row) to the next.
    pub row_pitch: usize,
    /// The pixel data.
    pub bytes: &'a [u8],
}

/// A mutable view of an image in memory.
#[derive(Debug)]
pub struct ImageMut<'a> {
    /// Pixel format of the data.
    pub format: PixelFormat,
    /// Width in pixels.
    pub width: usize,
    /// Height in pixels.
    pub height: usize,
    /// Bytes from one row (or block row) to the next.
    pub row_pitch: usize,
    /// The pixel data.
    pub bytes: &'a mut [u8],
}

fn validate(
    format: PixelFormat,
    width: usize,
    height: usize,
    row_pitch: usize,
    len: usize,
) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(CodecError::InvalidArgument("zero image dimension"));
    }
    let min_pitch = format.row_pitch(width);
    if min_pitch == 0 {
        return Err(CodecError::UnsupportedFormat(format));
    }
    if row_pitch < min_pitch {
        return Err(CodecError::InvalidArgument("row pitch smaller than a row"));
    }
    let rows = if format.is_compressed() {
        height.div_ceil(4)
    } else {
        height
    };
    let needed = (rows - 1) * row_pitch + min_pitch;
    if len < needed {
        return Err(CodecError::BufferTooSmall {
            needed,
            actual: len,
        });
    }
    Ok(())
}

fn alloc_line(count: usize) -> Result<Vec<Rgba>> {
    let mut line = Vec::new();
    line.try_reserve_exact(count)
        .map_err(|_| CodecError::OutOfMemory("scanline buffer"))?;
    line.resize(count, Rgba::ZERO);
    Ok(line)
}

/// Resolves the effective sRGB directions for a conversion, honouring
/// format declarations, capability, and the both-sides bypass.
fn resolve_srgb(
    src: PixelFormat,
    dst: PixelFormat,
    flags: ConvertFlags,
) -> (bool, bool) {
    let mut srgb_in =
        (flags.contains(ConvertFlags::SRGB_IN) || src.is_srgb()) && srgb_capable(src);
    let mut srgb_out =
        (flags.contains(ConvertFlags::SRGB_OUT) || dst.is_srgb()) && srgb_capable(dst);
    if srgb_in && srgb_out {
        // Both sides sRGB and nothing in between needs linear light.
        srgb_in = false;
        srgb_out = false;
    }
    (srgb_in, srgb_out)
}

/// Applies the channel adjustments implied by the difference between
/// the two format descriptors to a widened scanline.
fn adjust_channels(
    line: &mut [Rgba],
    src: PixelFormat,
    dst: PixelFormat,
    flags: ConvertFlags,
) {
    let Some(input) = src.descriptor() else { return };
    let Some(output) = dst.descriptor() else { return };

    let diff = input.flags.symmetric_difference(output.flags);
    if diff.is_empty() {
        return;
    }

    if output.flags.contains(FormatFlags::UNORM) {
        if input.flags.contains(FormatFlags::SNORM) {
            for p in line.iter_mut() {
                *p = *p * 0.5 + Rgba::new(0.5, 0.5, 0.5, 0.5);
            }
        } else if input.flags.contains(FormatFlags::FLOAT) {
            for p in line.iter_mut() {
                *p = p.clamp(0.0, 1.0);
            }
        }
    } else if output.flags.contains(FormatFlags::SNORM) {
        if input.flags.contains(FormatFlags::UNORM) {
            for p in line.iter_mut() {
                *p = *p * 2.0 - Rgba::new(1.0, 1.0, 1.0, 1.0);
            }
        } else if input.flags.contains(FormatFlags::FLOAT) {
            for p in line.iter_mut() {
                *p = p.clamp(-1.0, 1.0);
            }
        }
    }

    let in_rgb = input.flags.intersection(FormatFlags::RGB_MASK);
    let out_rgb = output.flags.intersection(FormatFlags::RGB_MASK);
    let in_rgba = input.flags.intersection(FormatFlags::RGBA_MASK);
    let out_rgba = output.flags.intersection(FormatFlags::RGBA_MASK);
    const RGB: FormatFlags = FormatFlags::R.union(FormatFlags::G).union(FormatFlags::B);
    const RG: FormatFlags = FormatFlags::R.union(FormatFlags::G);

    if out_rgba == FormatFlags::A && !input.flags.contains(FormatFlags::A) {
        // Alpha-only target fed from a colour source: broadcast red.
        for p in line.iter_mut() {
            *p = Rgba::new(p.r, p.r, p.r, p.r);
        }
    } else if in_rgba == FormatFlags::A && !output.flags.contains(FormatFlags::A) {
        // Colour target fed from an alpha-only source.
        for p in line.iter_mut() {
            *p = Rgba::new(p.a, p.a, p.a, p.a);
        }
    } else if in_rgb == FormatFlags::R {
        if out_rgb == RGB {
            for p in line.iter_mut() {
                *p = Rgba::new(p.r, p.r, p.r, p.a);
            }
        } else if out_rgb == RG {
            for p in line.iter_mut() {
                *p = Rgba::new(p.r, p.r, p.b, p.a);
            }
        }
    } else if in_rgb == RGB {
        if out_rgb == FormatFlags::R {
            let select = flags.intersection(
                ConvertFlags::RGB_COPY_RED
                    | ConvertFlags::RGB_COPY_GREEN
                    | ConvertFlags::RGB_COPY_BLUE,
            );
            if select == ConvertFlags::RGB_COPY_RED {
                // Red is already in place.
            } else if select == ConvertFlags::RGB_COPY_GREEN {
                for p in line.iter_mut() {
                    p.r = p.g;
                }
            } else if select == ConvertFlags::RGB_COPY_BLUE {
                for p in line.iter_mut() {
                    p.r = p.b;
                }
            } else {
                // All or none selected: luminance dot product.
                for p in line.iter_mut() {
                    p.r = p.r * GRAYSCALE.r + p.g * GRAYSCALE.g + p.b * GRAYSCALE.b;
                }
            }
        } else if out_rgb == RG {
            let select = flags.intersection(
                ConvertFlags::RGB_COPY_RED
                    | ConvertFlags::RGB_COPY_GREEN
                    | ConvertFlags::RGB_COPY_BLUE,
            );
            if select == ConvertFlags::RGB_COPY_RED | ConvertFlags::RGB_COPY_BLUE {
                for p in line.iter_mut() {
                    p.g = p.b;
                }
            } else if select == ConvertFlags::RGB_COPY_GREEN | ConvertFlags::RGB_COPY_BLUE {
                for p in line.iter_mut() {
                    p.r = p.g;
                    p.g = p.b;
                }
            }
            // Red+green or no selection: channels already in place.
        }
    }
}

fn apply_srgb_in(line: &mut [Rgba]) {
    for p in line.iter_mut() {
        p.r = srgb_to_linear(p.r);
        p.g = srgb_to_linear(p.g);
        p.b = srgb_to_linear(p.b);
    }
}

fn apply_srgb_out(line: &mut [Rgba]) {
    for p in line.iter_mut() {
        p.r = linear_to_srgb(p.r);
        p.g = linear_to_srgb(p.g);
        p.b = linear_to_srgb(p.b);
    }
}

/// Whether the conversion can use a bit-exact integer fast path
/// (no colour transform requested and sRGB-ness matches).
fn fast_path_allowed(src: PixelFormat, dst: PixelFormat, flags: ConvertFlags) -> bool {
    !flags.intersects(
        ConvertFlags::DITHER
            | ConvertFlags::DITHER_DIFFUSION
            | ConvertFlags::SRGB_IN
            | ConvertFlags::SRGB_OUT
            | ConvertFlags::RGB_COPY_RED
            | ConvertFlags::RGB_COPY_GREEN
            | ConvertFlags::RGB_COPY_BLUE,
    ) && src.is_srgb() == dst.is_srgb()
}

/// Converts `src` into `dst`, which must have the same dimensions.
///
/// Uncompressed-to-uncompressed conversions run the row pipeline; a
/// block-compressed destination or source delegates to [`compress`] or
/// [`decompress`]. Planar sources are first rebuilt into their packed
/// single-plane equivalents. On a row failure the destination keeps
/// the rows already written and the error reports how many.
pub fn convert(src: &Image, dst: &mut ImageMut, options: &ConvertOptions) -> Result<()> {
    if src.width != dst.width || src.height != dst.height {
        return Err(CodecError::InvalidArgument("image dimensions differ"));
    }

    // Planar sources become their packed single-plane form first.
    if src.format.is_planar() {
        let (packed_format, staged) = to_single_plane(src)?;
        let staged_image = Image {
            format: packed_format,
            width: src.width,
            height: src.height,
            row_pitch: packed_format.row_pitch(src.width),
            bytes: &staged[..],
        };
        return convert(&staged_image, dst, options);
    }
    if dst.format.is_planar() {
        return Err(CodecError::UnsupportedFormat(dst.format));
    }

    if src.format.is_compressed() && dst.format.is_compressed() {
        return Err(CodecError::InvalidArgument(
            "transcoding between compressed formats needs an uncompressed intermediate",
        ));
    }
    if dst.format.is_compressed() {
        return compress(src, dst, BcFlags::empty(), options.threshold);
    }
    if src.format.is_compressed() {
        return decompress(src, dst, options.flags);
    }

    validate(src.format, src.width, src.height, src.row_pitch, src.bytes.len())?;
    validate(dst.format, dst.width, dst.height, dst.row_pitch, dst.bytes.len())?;

    let width = src.width;
    let src_row_bytes = src.format.row_pitch(width);
    let dst_row_bytes = dst.format.row_pitch(width);

    // Bit-identical fast paths.
    if fast_path_allowed(src.format, dst.format, options.flags) {
        let same = src.format == dst.format;
        let alpha_fill = matches!(
            (src.format, dst.format),
            (PixelFormat::B8G8R8X8Unorm, PixelFormat::B8G8R8A8Unorm)
                | (PixelFormat::B8G8R8X8UnormSrgb, PixelFormat::B8G8R8A8UnormSrgb)
        );
        let swizzle = matches!(
            (src.format, dst.format),
            (PixelFormat::R8G8B8A8Unorm, PixelFormat::B8G8R8A8Unorm)
                | (PixelFormat::B8G8R8A8Unorm, PixelFormat::R8G8B8A8Unorm)
                | (PixelFormat::R8G8B8A8UnormSrgb, PixelFormat::B8G8R8A8UnormSrgb)
                | (PixelFormat::B8G8R8A8UnormSrgb, PixelFormat::R8G8B8A8UnormSrgb)
        );
        let expand = matches!(
            (src.format, dst.format),
            (PixelFormat::B5G6R5Unorm, PixelFormat::R8G8B8A8Unorm)
                | (PixelFormat::B5G5R5A1Unorm, PixelFormat::R8G8B8A8Unorm)
                | (PixelFormat::B4G4R4A4Unorm, PixelFormat::R8G8B8A8Unorm)
        );

        if same || alpha_fill || swizzle || expand {
            for y in 0..src.height {
                let s = &src.bytes[y * src.row_pitch..y * src.row_pitch + src_row_bytes];
                let d = &mut dst.bytes[y * dst.row_pitch..y * dst.row_pitch + dst_row_bytes];
                let ok = if same {
                    copy_scanline(src.format, s, d, false)
                } else if alpha_fill {
                    copy_scanline(dst.format, s, d, true)
                } else if swizzle {
                    swizzle_scanline(src.format, s, d)
                } else {
                    expand_scanline(src.format, dst.format, s, d)
                };
                if !ok {
                    return Err(CodecError::Conversion { rows_written: y });
                }
            }
            return Ok(());
        }
    }

    // General path: widen, adjust, narrow, row by row.
    let (srgb_in, srgb_out) = resolve_srgb(src.format, dst.format, options.flags);
    let mut line = alloc_line(width)?;

    let diffusing = options.flags.contains(ConvertFlags::DITHER_DIFFUSION);
    let ordered = options.flags.contains(ConvertFlags::DITHER);
    let mut diffusion = if diffusing {
        Some(alloc_line(width + 2)?)
    } else {
        None
    };

    for y in 0..src.height {
        let s = &src.bytes[y * src.row_pitch..y * src.row_pitch + src_row_bytes];
        let d = &mut dst.bytes[y * dst.row_pitch..y * dst.row_pitch + dst_row_bytes];

        if !load_scanline(src.format, s, &mut line) {
            debug!("row {y} failed to load as {:?}", src.format);
            return Err(CodecError::Conversion { rows_written: y });
        }

        if srgb_in {
            apply_srgb_in(&mut line);
        }
        adjust_channels(&mut line, src.format, dst.format, options.flags);
        if srgb_out {
            apply_srgb_out(&mut line);
        }

        let ok = if diffusing || ordered {
            store_scanline_dither(
                dst.format,
                &mut line,
                d,
                y,
                0,
                diffusion.as_deref_mut(),
            )
        } else {
            store_scanline(dst.format, &line, d)
        };
        if !ok {
            debug!("row {y} failed to store as {:?}", dst.format);
            return Err(CodecError::Conversion { rows_written: y });
        }
    }

    Ok(())
}

/// Gathers the 4x4 block at `(bx, by)` from four widened rows,
/// clamping at the image edges.
fn gather_block(rows: &[Vec<Rgba>; 4], width: usize, bx: usize) -> [Rgba; BLOCK_PIXELS] {
    let mut block = [Rgba::ZERO; BLOCK_PIXELS];
    for (dy, row) in rows.iter().enumerate() {
        for dx in 0..4 {
            let x = (bx * 4 + dx).min(width - 1);
            block[dy * 4 + dx] = row[x];
        }
    }
    block
}

fn encode_block(
    format: PixelFormat,
    pixels: &[Rgba; BLOCK_PIXELS],
    flags: BcFlags,
    threshold: f32,
) -> Option<([u8; 16], usize)> {
    use PixelFormat as F;
    let mut out = [0u8; 16];
    let len = match format {
        F::Bc1Unorm | F::Bc1UnormSrgb => {
            out[..8].copy_from_slice(&bc1::encode_bc1(pixels, true, threshold, flags));
            8
        }
        F::Bc2Unorm | F::Bc2UnormSrgb => {
            out.copy_from_slice(&bc1::encode_bc2(pixels, flags));
            16
        }
        F::Bc3Unorm | F::Bc3UnormSrgb => {
            out.copy_from_slice(&bc1::encode_bc3(pixels, flags));
            16
        }
        F::Bc4Unorm => {
            out[..8].copy_from_slice(&bc4::encode_bc4u(pixels));
            8
        }
        F::Bc4Snorm => {
            out[..8].copy_from_slice(&bc4::encode_bc4s(pixels));
            8
        }
        F::Bc5Unorm => {
            out.copy_from_slice(&bc4::encode_bc5u(pixels));
            16
        }
        F::Bc5Snorm => {
            out.copy_from_slice(&bc4::encode_bc5s(pixels));
            16
        }
        F::Bc6hUf16 => {
            out.copy_from_slice(&bc6h::encode_bc6h(pixels, false));
            16
        }
        F::Bc6hSf16 => {
            out.copy_from_slice(&bc6h::encode_bc6h(pixels, true));
            16
        }
        F::Bc7Unorm | F::Bc7UnormSrgb => {
            out.copy_from_slice(&bc7::encode_bc7(pixels));
            16
        }
        _ => return None,
    };
    Some((out, len))
}

fn decode_block(format: PixelFormat, bytes: &[u8]) -> Option<[Rgba; BLOCK_PIXELS]> {
    use PixelFormat as F;
    match format {
        F::Bc1Unorm | F::Bc1UnormSrgb => Some(bc1::decode_bc1(bytes[..8].try_into().ok()?)),
        F::Bc2Unorm | F::Bc2UnormSrgb => Some(bc1::decode_bc2(bytes[..16].try_into().ok()?)),
        F::Bc3Unorm | F::Bc3UnormSrgb => Some(bc1::decode_bc3(bytes[..16].try_into().ok()?)),
        F::Bc4Unorm => Some(bc4::decode_bc4u(bytes[..8].try_into().ok()?)),
        F::Bc4Snorm => Some(bc4::decode_bc4s(bytes[..8].try_into().ok()?)),
        F::Bc5Unorm => Some(bc4::decode_bc5u(bytes[..16].try_into().ok()?)),
        F::Bc5Snorm => Some(bc4::decode_bc5s(bytes[..16].try_into().ok()?)),
        F::Bc6hUf16 => Some(bc6h::decode_bc6h(bytes[..16].try_into().ok()?, false)),
        F::Bc6hSf16 => Some(bc6h::decode_bc6h(bytes[..16].try_into().ok()?, true)),
        F::Bc7Unorm | F::Bc7UnormSrgb => Some(bc7::decode_bc7(bytes[..16].try_into().ok()?)),
        _ => None,
    }
}

/// Compresses an uncompressed image into a block-compressed one.
///
/// `flags` control the BC1–BC3 encoders; `threshold` is the alpha
/// reference for BC1's transparent palette slot. When exactly one side
/// is sRGB-declared the colour channels move through the transfer
/// function before quantisation.
pub fn compress(
    src: &Image,
    dst: &mut ImageMut,
    flags: BcFlags,
    threshold: f32,
) -> Result<()> {
    if src.width != dst.width || src.height != dst.height {
        return Err(CodecError::InvalidArgument("image dimensions differ"));
    }
    if !dst.format.is_compressed() {
        return Err(CodecError::InvalidArgument("destination is not block-compressed"));
    }
    if src.format.is_compressed() {
        return Err(CodecError::InvalidArgument("source is already compressed"));
    }
    validate(src.format, src.width, src.height, src.row_pitch, src.bytes.len())?;
    validate(dst.format, dst.width, dst.height, dst.row_pitch, dst.bytes.len())?;

    let width = src.width;
    let src_row_bytes = src.format.row_pitch(width);
    let block_bytes = dst.format.block_bytes();
    let blocks_x = width.div_ceil(4);

    let to_srgb = dst.format.is_srgb() && !src.format.is_srgb();
    let to_linear = src.format.is_srgb() && !dst.format.is_srgb();

    let mut rows: [Vec<Rgba>; 4] = [
        alloc_line(width)?,
        alloc_line(width)?,
        alloc_line(width)?,
        alloc_line(width)?,
    ];

    for by in 0..src.height.div_ceil(4) {
        for (dy, row) in rows.iter_mut().enumerate() {
            // Clamp the final partial band to the last real row.
            let y = (by * 4 + dy).min(src.height - 1);
            let s = &src.bytes[y * src.row_pitch..y * src.row_pitch + src_row_bytes];
            if !load_scanline(src.format, s, row) {
                return Err(CodecError::Conversion { rows_written: by * 4 });
            }
            if to_linear {
                apply_srgb_in(row);
            } else if to_srgb {
                apply_srgb_out(row);
            }
            adjust_channels(row, src.format, dst.format, ConvertFlags::empty());
        }

        let dst_row =
            &mut dst.bytes[by * dst.row_pitch..by * dst.row_pitch + blocks_x * block_bytes];
        for bx in 0..blocks_x {
            let block = gather_block(&rows, width, bx);
            let Some((encoded, len)) = encode_block(dst.format, &block, flags, threshold) else {
                return Err(CodecError::UnsupportedFormat(dst.format));
            };
            dst_row[bx * block_bytes..bx * block_bytes + len].copy_from_slice(&encoded[..len]);
        }
    }

    Ok(())
}

/// Decompresses a block-compressed image into an uncompressed one.
pub fn decompress(src: &Image, dst: &mut ImageMut, flags: ConvertFlags) -> Result<()> {
    if src.width != dst.width || src.height != dst.height {
        return Err(CodecError::InvalidArgument("image dimensions differ"));
    }
    if !src.format.is_compressed() {
        return Err(CodecError::InvalidArgument("source is not block-compressed"));
    }
    if dst.format.is_compressed() {
        return Err(CodecError::InvalidArgument("destination is compressed"));
    }
    validate(src.format, src.width, src.height, src.row_pitch, src.bytes.len())?;
    validate(dst.format, dst.width, dst.height, dst.row_pitch, dst.bytes.len())?;

    let width = src.width;
    let dst_row_bytes = dst.format.row_pitch(width);
    let block_bytes = src.format.block_bytes();
    let blocks_x = width.div_ceil(4);

    let to_srgb = dst.format.is_srgb() && !src.format.is_srgb();
    let to_linear = src.format.is_srgb() && !dst.format.is_srgb();

    let mut rows: [Vec<Rgba>; 4] = [
        alloc_line(width)?,
        alloc_line(width)?,
        alloc_line(width)?,
        alloc_line(width)?,
    ];

    for by in 0..src.height.div_ceil(4) {
        let src_row = &src.bytes[by * src.row_pitch..];
        for bx in 0..blocks_x {
            let Some(block) = decode_block(src.format, &src_row[bx * block_bytes..]) else {
                return Err(CodecError::UnsupportedFormat(src.format));
            };
            for dy in 0..4 {
                for dx in 0..4 {
                    let x = bx * 4 + dx;
                    if x < width {
                        rows[dy][x] = block[dy * 4 + dx];
                    }
                }
            }
        }

        for (dy, row) in rows.iter_mut().enumerate() {
            let y = by * 4 + dy;
            if y >= src.height {
                break;
            }
            if to_linear {
                apply_srgb_in(row);
            } else if to_srgb {
                apply_srgb_out(row);
            }
            adjust_channels(row, src.format, dst.format, flags);
            let d = &mut dst.bytes[y * dst.row_pitch..y * dst.row_pitch + dst_row_bytes];
            if !store_scanline(dst.format, row, d) {
                return Err(CodecError::Conversion { rows_written: y });
            }
        }
    }

    Ok(())
}

/// Rebuilds a planar image into its packed single-plane form
/// (NV12/NV11 to YUY2, P010 to Y210, P016 to Y216).
///
/// This is a per-block chroma reshuffle; no colour math happens.
fn to_single_plane(src: &Image) -> Result<(PixelFormat, BytesMut)> {
    use PixelFormat as F;

    let (packed, wide) = match src.format {
        F::Nv12 | F::Nv11 => (F::Yuy2, false),
        F::P010 => (F::Y210, true),
        F::P016 => (F::Y216, true),
        _ => return Err(CodecError::UnsupportedFormat(src.format)),
    };
    if src.width & 1 != 0 || src.height & 1 != 0 {
        return Err(CodecError::InvalidArgument(
            "planar images need even dimensions",
        ));
    }

    let width = src.width;
    let height = src.height;
    let luma_pitch = src.row_pitch;

    // Luma plane is `height` rows; chroma follows at the same pitch.
    let chroma_rows = match src.format {
        F::Nv11 => height,
        _ => height / 2,
    };
    let needed = luma_pitch * (height + chroma_rows);
    if src.bytes.len() < needed {
        return Err(CodecError::BufferTooSmall {
            needed,
            actual: src.bytes.len(),
        });
    }

    let out_pitch = packed.row_pitch(width);
    let mut out = BytesMut::with_capacity(out_pitch * height);
    let chroma_base = luma_pitch * height;

    for y in 0..height {
        let luma = &src.bytes[y * luma_pitch..];
        let chroma_row = match src.format {
            F::Nv11 => y,
            _ => y / 2,
        };
        let chroma = &src.bytes[chroma_base + chroma_row * luma_pitch..];

        for x in (0..width).step_by(2) {
            // Chroma advances every two pixels (4:2:2 output); NV11
            // repeats each chroma pair across four pixels.
            let cx = match src.format {
                F::Nv11 => (x / 4) * 2,
                _ => x / 2 * 2,
            };
            if wide {
                let at = |buf: &[u8], i: usize| u16::from_le_bytes([buf[i * 2], buf[i * 2 + 1]]);
                out.put_u16_le(at(luma, x));
                out.put_u16_le(at(chroma, cx));
                out.put_u16_le(at(luma, x + 1));
                out.put_u16_le(at(chroma, cx + 1));
            } else {
                out.put_u8(luma[x]);
                out.put_u8(chroma[cx]);
                out.put_u8(luma[x + 1]);
                out.put_u8(chroma[cx + 1]);
            }
        }
    }

    Ok((packed, out))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_image(format: PixelFormat, width: usize, height: usize) -> (Vec<u8>, usize) {
        let pitch = format.row_pitch(width);
        let rows = if format.is_compressed() {
            height.div_ceil(4)
        } else {
            height
        };
        (vec![0u8; pitch * rows], pitch)
    }

    #[test]
    fn test_rgba32f_to_rgba8_round_trip() {
        let width = 4;
        let height = 4;
        let src_pixels = [Rgba::new(0.25, 0.5, 0.75, 1.0); 16];
        let mut src_bytes = vec![0u8; 16 * 16];
        assert!(store_scanline(
            PixelFormat::R32G32B32A32Float,
            &src_pixels,
            &mut src_bytes,
        ));

        let (mut mid, mid_pitch) = make_image(PixelFormat::R8G8B8A8Unorm, width, height);
        convert(
            &Image {
                format: PixelFormat::R32G32B32A32Float,
                width,
                height,
                row_pitch: 16 * 4,
                bytes: &src_bytes,
            },
            &mut ImageMut {
                format: PixelFormat::R8G8B8A8Unorm,
                width,
                height,
                row_pitch: mid_pitch,
                bytes: &mut mid,
            },
            &ConvertOptions::default(),
        )
        .unwrap();

        let (mut back, back_pitch) = make_image(PixelFormat::R32G32B32A32Float, width, height);
        convert(
            &Image {
                format: PixelFormat::R8G8B8A8Unorm,
                width,
                height,
                row_pitch: mid_pitch,
                bytes: &mid,
            },
            &mut ImageMut {
                format: PixelFormat::R32G32B32A32Float,
                width,
                height,
                row_pitch: back_pitch,
                bytes: &mut back,
            },
            &ConvertOptions::default(),
        )
        .unwrap();

        let mut out = [Rgba::ZERO; 16];
        assert!(load_scanline(PixelFormat::R32G32B32A32Float, &back, &mut out));
        for p in out {
            assert!((p.r - 0.25).abs() <= 1.0 / 255.0);
            assert!((p.g - 0.5).abs() <= 1.0 / 255.0);
            assert!((p.b - 0.75).abs() <= 1.0 / 255.0);
            assert_eq!(p.a, 1.0);
        }
    }

    #[test]
    fn test_swizzle_fast_path_matches_general() {
        let width = 8;
        let height = 2;
        let mut src_bytes = vec![0u8; width * height * 4];
        for (i, b) in src_bytes.iter_mut().enumerate() {
            *b = (i * 7 + 3) as u8;
        }

        let run = |dst_format| {
            let (mut out, pitch) = make_image(dst_format, width, height);
            convert(
                &Image {
                    format: PixelFormat::R8G8B8A8Unorm,
                    width,
                    height,
                    row_pitch: width * 4,
                    bytes: &src_bytes,
                },
                &mut ImageMut {
                    format: dst_format,
                    width,
                    height,
                    row_pitch: pitch,
                    bytes: &mut out,
                },
                &ConvertOptions::default(),
            )
            .unwrap();
            out
        };

        let fast = run(PixelFormat::B8G8R8A8Unorm);
        for (s, d) in src_bytes.chunks(4).zip(fast.chunks(4)) {
            assert_eq!([s[2], s[1], s[0], s[3]], [d[0], d[1], d[2], d[3]]);
        }
    }

    #[test]
    fn test_luma_copy() {
        let width = 2;
        let height = 1;
        let src_bytes = [255u8, 0, 0, 255, 0, 255, 0, 255];
        let (mut out, pitch) = make_image(PixelFormat::R8Unorm, width, height);
        convert(
            &Image {
                format: PixelFormat::R8G8B8A8Unorm,
                width,
                height,
                row_pitch: 8,
                bytes: &src_bytes,
            },
            &mut ImageMut {
                format: PixelFormat::R8Unorm,
                width,
                height,
                row_pitch: pitch,
                bytes: &mut out,
            },
            &ConvertOptions::default(),
        )
        .unwrap();
        // Pure red and pure green under the luminance weights.
        assert_eq!(out[0], (0.2125f32 * 255.0).round() as u8);
        assert_eq!(out[1], (0.7154f32 * 255.0).round() as u8);
    }

    #[test]
    fn test_green_copy_flag() {
        let src_bytes = [10u8, 200, 30, 255];
        let (mut out, pitch) = make_image(PixelFormat::R8Unorm, 1, 1);
        convert(
            &Image {
                format: PixelFormat::R8G8B8A8Unorm,
                width: 1,
                height: 1,
                row_pitch: 4,
                bytes: &src_bytes,
            },
            &mut ImageMut {
                format: PixelFormat::R8Unorm,
                width: 1,
                height: 1,
                row_pitch: pitch,
                bytes: &mut out,
            },
            &ConvertOptions {
                flags: ConvertFlags::RGB_COPY_GREEN,
                threshold: 0.5,
            },
        )
        .unwrap();
        assert_eq!(out[0], 200);
    }

    #[test]
    fn test_unorm_to_snorm_rescale() {
        let src_bytes = [255u8, 0, 128, 255];
        let (mut out, pitch) = make_image(PixelFormat::R8G8B8A8Snorm, 1, 1);
        convert(
            &Image {
                format: PixelFormat::R8G8B8A8Unorm,
                width: 1,
                height: 1,
                row_pitch: 4,
                bytes: &src_bytes,
            },
            &mut ImageMut {
                format: PixelFormat::R8G8B8A8Snorm,
                width: 1,
                height: 1,
                row_pitch: pitch,
                bytes: &mut out,
            },
            &ConvertOptions::default(),
        )
        .unwrap();
        assert_eq!(out[0] as i8, 127); // 1.0 -> 1.0
        assert_eq!(out[1] as i8, -127); // 0.0 -> -1.0
    }

    #[test]
    fn test_compress_decompress_bc1() {
        let width = 8;
        let height = 8;
        let mut src_bytes = vec![0u8; width * height * 4];
        for y in 0..height {
            for x in 0..width {
                let o = (y * width + x) * 4;
                src_bytes[o] = if x < 4 { 255 } else { 0 };
                src_bytes[o + 2] = if x < 4 { 0 } else { 255 };
                src_bytes[o + 3] = 255;
            }
        }

        let (mut packed, bc_pitch) = make_image(PixelFormat::Bc1Unorm, width, height);
        compress(
            &Image {
                format: PixelFormat::R8G8B8A8Unorm,
                width,
                height,
                row_pitch: width * 4,
                bytes: &src_bytes,
            },
            &mut ImageMut {
                format: PixelFormat::Bc1Unorm,
                width,
                height,
                row_pitch: bc_pitch,
                bytes: &mut packed,
            },
            BcFlags::UNIFORM,
            0.5,
        )
        .unwrap();
        assert_eq!(bc_pitch, 2 * 8);

        let (mut out, out_pitch) = make_image(PixelFormat::R8G8B8A8Unorm, width, height);
        decompress(
            &Image {
                format: PixelFormat::Bc1Unorm,
                width,
                height,
                row_pitch: bc_pitch,
                bytes: &packed,
            },
            &mut ImageMut {
                format: PixelFormat::R8G8B8A8Unorm,
                width,
                height,
                row_pitch: out_pitch,
                bytes: &mut out,
            },
            ConvertFlags::empty(),
        )
        .unwrap();

        for y in 0..height {
            for x in 0..width {
                let o = y * out_pitch + x * 4;
                if x < 4 {
                    assert!(out[o] > 200 && out[o + 2] < 50, "({x},{y})");
                } else {
                    assert!(out[o] < 50 && out[o + 2] > 200, "({x},{y})");
                }
            }
        }
    }

    #[test]
    fn test_convert_rejects_mismatched_sizes() {
        let src_bytes = [0u8; 16];
        let mut dst_bytes = [0u8; 16];
        let err = convert(
            &Image {
                format: PixelFormat::R8G8B8A8Unorm,
                width: 2,
                height: 2,
                row_pitch: 8,
                bytes: &src_bytes,
            },
            &mut ImageMut {
                format: PixelFormat::R8G8B8A8Unorm,
                width: 1,
                height: 1,
                row_pitch: 4,
                bytes: &mut dst_bytes,
            },
            &ConvertOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CodecError::InvalidArgument(_)));
    }

    #[test]
    fn test_convert_rejects_short_buffer() {
        let src_bytes = [0u8; 8];
        let mut dst_bytes = [0u8; 16];
        let err = convert(
            &Image {
                format: PixelFormat::R8G8B8A8Unorm,
                width: 2,
                height: 2,
                row_pitch: 8,
                bytes: &src_bytes,
            },
            &mut ImageMut {
                format: PixelFormat::R8G8B8A8Unorm,
                width: 2,
                height: 2,
                row_pitch: 8,
                bytes: &mut dst_bytes,
            },
            &ConvertOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CodecError::BufferTooSmall { .. }));
    }

    #[test]
    fn test_nv12_single_plane_staging() {
        // 2x2 NV12: 2 luma rows then 1 interleaved chroma row.
        let width = 2;
        let height = 2;
        let bytes = [10u8, 20, 30, 40, 128, 128];
        let src = Image {
            format: PixelFormat::Nv12,
            width,
            height,
            row_pitch: 2,
            bytes: &bytes,
        };
        let (format, staged) = to_single_plane(&src).unwrap();
        assert_eq!(format, PixelFormat::Yuy2);
        // Row 0: Y=10, U=128, Y=20, V=128.
        assert_eq!(&staged[..4], &[10, 128, 20, 128]);
        // Row 1 shares the same chroma row.
        assert_eq!(&staged[4..8], &[30, 128, 40, 128]);
    }

    #[test]
    fn test_dither_diffusion_path_runs() {
        let width = 16;
        let height = 4;
        let mut src_bytes = vec![0u8; width * height * 4];
        for px in src_bytes.chunks_exact_mut(4) {
            px.copy_from_slice(&[100, 150, 200, 255]);
        }
        let (mut out, pitch) = make_image(PixelFormat::B5G6R5Unorm, width, height);
        convert(
            &Image {
                format: PixelFormat::R8G8B8A8Unorm,
                width,
                height,
                row_pitch: width * 4,
                bytes: &src_bytes,
            },
            &mut ImageMut {
                format: PixelFormat::B5G6R5Unorm,
                width,
                height,
                row_pitch: pitch,
                bytes: &mut out,
            },
            &ConvertOptions {
                flags: ConvertFlags::DITHER_DIFFUSION,
                threshold: 0.5,
            },
        )
        .unwrap();
        // The dithered rows must stay close to the source on average.
        let mut line = vec![Rgba::ZERO; width];
        assert!(load_scanline(PixelFormat::B5G6R5Unorm, &out, &mut line));
        let mean_r: f32 = line.iter().map(|p| p.r).sum::<f32>() / width as f32;
        assert!((mean_r - 100.0 / 255.0).abs() < 0.03, "mean {mean_r}");
    }
}
