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

//! Block-compression codec implementations.
//!
//! One module per codec family, sharing the partition, fix-up, and
//! interpolation-weight tables defined here. All tables are process
//! lifetime constants; the codecs hold no state between calls.

pub mod bc1;
pub mod bc4;
pub mod bc6h;
pub mod bc7;

use crate::pixel::LdrColor;
use bitflags::bitflags;

bitflags! {
    /// Options accepted by the BC1–BC3 encoders.
    ///
    /// The ordinals are part of the external ABI and must not change.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct BcFlags: u32 {
        /// Floyd–Steinberg dithering of the RGB channels.
        const DITHER_RGB = 0x0001_0000;
        /// Floyd–Steinberg dithering of the alpha channel.
        const DITHER_A = 0x0002_0000;
        /// Uniform channel weighting instead of the default perceptual
        /// weighting.
        const UNIFORM = 0x0004_0000;
    }
}

/// Interpolation weight denominator for BC6H/BC7 palettes.
pub const WEIGHT_MAX: i32 = 64;
/// Shift applied after weighted interpolation.
pub const WEIGHT_SHIFT: u32 = 6;
/// Rounding bias applied before the weight shift.
pub const WEIGHT_ROUND: i32 = 32;

/// Interpolation weights for 2-bit indices.
pub const WEIGHTS2: [i32; 4] = [0, 21, 43, 64];
/// Interpolation weights for 3-bit indices.
pub const WEIGHTS3: [i32; 8] = [0, 9, 18, 27, 37, 46, 55, 64];
/// Interpolation weights for 4-bit indices.
pub const WEIGHTS4: [i32; 16] = [0, 4, 9, 13, 17, 21, 26, 30, 34, 38, 43, 47, 51, 55, 60, 64];

/// Returns the weight table for an index precision of 2, 3, or 4 bits.
#[inline]
#[must_use]
pub fn weights(prec: usize) -> &'static [i32] {
    match prec {
        2 => &WEIGHTS2,
        3 => &WEIGHTS3,
        4 => &WEIGHTS4,
        _ => unreachable!("index precision out of range: {prec}"),
    }
}

/// Partition assignments, indexed by
/// `[partition_count - 1][shape][pixel]`.
#[rustfmt::skip]
pub static PARTITION_TABLE: [[[u8; 16]; 64]; 3] = [
    // One region: every shape assigns all pixels to subset 0.
    [[0; 16]; 64],

    // Two regions.
    [
        [0, 0, 1, 1, 0, 0, 1, 1, 0, 0, 1, 1, 0, 0, 1, 1],
        [0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1],
        [0, 1, 1, 1, 0, 1, 1, 1, 0, 1, 1, 1, 0, 1, 1, 1],
        [0, 0, 0, 1, 0, 0, 1, 1, 0, 0, 1, 1, 0, 1, 1, 1],
        [0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 1, 1],
        [0, 0, 1, 1, 0, 1, 1, 1, 0, 1, 1, 1, 1, 1, 1, 1],
        [0, 0, 0, 1, 0, 0, 1, 1, 0, 1, 1, 1, 1, 1, 1, 1],
        [0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 1, 1, 0, 1, 1, 1],
        [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 1, 1],
        [0, 0, 1, 1, 0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1],
        [0, 0, 0, 0, 0, 0, 0, 1, 0, 1, 1, 1, 1, 1, 1, 1],
        [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 1, 1, 1],
        [0, 0, 0, 1, 0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1],
        [0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 1],
        [0, 0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1],
        [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1],
        [0, 0, 0, 0, 1, 0, 0, 0, 1, 1, 1, 0, 1, 1, 1, 1],
        [0, 1, 1, 1, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0],
        [0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 1, 1, 1, 0],
        [0, 1, 1, 1, 0, 0, 1, 1, 0, 0, 0, 1, 0, 0, 0, 0],
        [0, 0, 1, 1, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0],
        [0, 0, 0, 0, 1, 0, 0, 0, 1, 1, 0, 0, 1, 1, 1, 0],
        [0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 1, 1, 0, 0],
        [0, 1, 1, 1, 0, 0, 1, 1, 0, 0, 1, 1, 0, 0, 0, 1],
        [0, 0, 1, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 0],
        [0, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 1, 0, 0],
        [0, 1, 1, 0, 0, 1, 1, 0, 0, 1, 1, 0, 0, 1, 1, 0],
        [0, 0, 1, 1, 0, 1, 1, 0, 0, 1, 1, 0, 1, 1, 0, 0],
        [0, 0, 0, 1, 0, 1, 1, 1, 1, 1, 1, 0, 1, 0, 0, 0],
        [0, 0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0],
        [0, 1, 1, 1, 0, 0, 0, 1, 1, 0, 0, 0, 1, 1, 1, 0],
        [0, 0, 1, 1, 1, 0, 0, 1, 1, 0, 0, 1, 1, 1, 0, 0],
        [0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1],
        [0, 0, 0, 0, 1, 1, 1, 1, 0, 0, 0, 0, 1, 1, 1, 1],
        [0, 1, 0, 1, 1, 0, 1, 0, 0, 1, 0, 1, 1, 0, 1, 0],
        [0, 0, 1, 1, 0, 0, 1, 1, 1, 1, 0, 0, 1, 1, 0, 0],
        [0, 0, 1, 1, 1, 1, 0, 0, 0, 0, 1, 1, 1, 1, 0, 0],
        [0, 1, 0, 1, 0, 1, 0, 1, 1, 0, 1, 0, 1, 0, 1, 0],
        [0, 1, 1, 0, 1, 0, 0, 1, 0, 1, 1, 0, 1, 0, 0, 1],
        [0, 1, 0, 1, 1, 0, 1, 0, 1, 0, 1, 0, 0, 1, 0, 1],
        [0, 1, 1, 1, 0, 0, 1, 1, 1, 1, 0, 0, 1, 1, 1, 0],
        [0, 0, 0, 1, 0, 0, 1, 1, 1, 1, 0, 0, 1, 0, 0, 0],
        [0, 0, 1, 1, 0, 0, 1, 0, 0, 1, 0, 0, 1, 1, 0, 0],
        [0, 0, 1, 1, 1, 0, 1, 1, 1, 1, 0, 1, 1, 1, 0, 0],
        [0, 1, 1, 0, 1, 0, 0, 1, 1, 0, 0, 1, 0, 1, 1, 0],
        [0, 0, 1, 1, 1, 1, 0, 0, 1, 1, 0, 0, 0, 0, 1, 1],
        [0, 1, 1, 0, 0, 1, 1, 0, 1, 0, 0, 1, 1, 0, 0, 1],
        [0, 0, 0, 0, 0, 1, 1, 0, 0, 1, 1, 0, 0, 0, 0, 0],
        [0, 1, 0, 0, 1, 1, 1, 0, 0, 1, 0, 0, 0, 0, 0, 0],
        [0, 0, 1, 0, 0, 1, 1, 1, 0, 0, 1, 0, 0, 0, 0, 0],
        [0, 0, 0, 0, 0, 0, 1, 0, 0, 1, 1, 1, 0, 0, 1, 0],
        [0, 0, 0, 0, 0, 1, 0, 0, 1, 1, 1, 0, 0, 1, 0, 0],
        [0, 1, 1, 0, 1, 1, 0, 0, 1, 0, 0, 1, 0, 0, 1, 1],
        [0, 0, 1, 1, 0, 1, 1, 0, 1, 1, 0, 0, 1, 0, 0, 1],
        [0, 1, 1, 0, 0, 0, 1, 1, 1, 0, 0, 1, 1, 1, 0, 0],
        [0, 0, 1, 1, 1, 0, 0, 1, 1, 1, 0, 0, 0, 1, 1, 0],
        [0, 1, 1, 0, 1, 1, 0, 0, 1, 1, 0, 0, 1, 0, 0, 1],
        [0, 1, 1, 0, 0, 0, 1, 1, 0, 0, 1, 1, 1, 0, 0, 1],
        [0, 1, 1, 1, 1, 1, 1, 0, 1, 0, 0, 0, 0, 0, 0, 1],
        [0, 0, 0, 1, 1, 0, 0, 0, 1, 1, 1, 0, 0, 1, 1, 1],
        [0, 0, 0, 0, 1, 1, 1, 1, 0, 0, 1, 1, 0, 0, 1, 1],
        [0, 0, 1, 1, 0, 0, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0],
        [0, 0, 1, 0, 0, 0, 1, 0, 1, 1, 1, 0, 1, 1, 1, 0],
        [0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 1, 1, 0, 1, 1, 1],
    ],

    // Three regions.
    [
        [0, 0, 1, 1, 0, 0, 1, 1, 0, 2, 2, 1, 2, 2, 2, 2],
        [0, 0, 0, 1, 0, 0, 1, 1, 2, 2, 1, 1, 2, 2, 2, 1],
        [0, 0, 0, 0, 2, 0, 0, 1, 2, 2, 1, 1, 2, 2, 1, 1],
        [0, 2, 2, 2, 0, 0, 2, 2, 0, 0, 1, 1, 0, 1, 1, 1],
        [0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 2, 2, 1, 1, 2, 2],
        [0, 0, 1, 1, 0, 0, 1, 1, 0, 0, 2, 2, 0, 0, 2, 2],
        [0, 0, 2, 2, 0, 0, 2, 2, 1, 1, 1, 1, 1, 1, 1, 1],
        [0, 0, 1, 1, 0, 0, 1, 1, 2, 2, 1, 1, 2, 2, 1, 1],
        [0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2],
        [0, 0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 1, 2, 2, 2, 2],
        [0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 2, 2, 2, 2],
        [0, 0, 1, 2, 0, 0, 1, 2, 0, 0, 1, 2, 0, 0, 1, 2],
        [0, 1, 1, 2, 0, 1, 1, 2, 0, 1, 1, 2, 0, 1, 1, 2],
        [0, 1, 2, 2, 0, 1, 2, 2, 0, 1, 2, 2, 0, 1, 2, 2],
        [0, 0, 1, 1, 0, 1, 1, 2, 1, 1, 2, 2, 1, 2, 2, 2],
        [0, 0, 1, 1, 2, 0, 0, 1, 2, 2, 0, 0, 2, 2, 2, 0],
        [0, 0, 0, 1, 0, 0, 1, 1, 0, 1, 1, 2, 1, 1, 2, 2],
        [0, 1, 1, 1, 0, 0, 1, 1, 2, 0, 0, 1, 2, 2, 0, 0],
        [0, 0, 0, 0, 1, 1, 2, 2, 1, 1, 2, 2, 1, 1, 2, 2],
        [0, 0, 2, 2, 0, 0, 2, 2, 0, 0, 2, 2, 1, 1, 1, 1],
        [0, 1, 1, 1, 0, 1, 1, 1, 0, 2, 2, 2, 0, 2, 2, 2],
        [0, 0, 0, 1, 0, 0, 0, 1, 2, 2, 2, 1, 2, 2, 2, 1],
        [0, 0, 0, 0, 0, 0, 1, 1, 0, 1, 2, 2, 0, 1, 2, 2],
        [0, 0, 0, 0, 1, 1, 0, 0, 2, 2, 1, 0, 2, 2, 1, 0],
        [0, 1, 2, 2, 0, 1, 2, 2, 0, 0, 1, 1, 0, 0, 0, 0],
        [0, 0, 1, 2, 0, 0, 1, 2, 1, 1, 2, 2, 2, 2, 2, 2],
        [0, 1, 1, 0, 1, 2, 2, 1, 1, 2, 2, 1, 0, 1, 1, 0],
        [0, 0, 0, 0, 0, 1, 1, 0, 1, 2, 2, 1, 1, 2, 2, 1],
        [0, 0, 2, 2, 1, 1, 0, 2, 1, 1, 0, 2, 0, 0, 2, 2],
        [0, 1, 1, 0, 0, 1, 1, 0, 2, 0, 0, 2, 2, 2, 2, 2],
        [0, 0, 1, 1, 0, 1, 2, 2, 0, 1, 2, 2, 0, 0, 1, 1],
        [0, 0, 0, 0, 2, 0, 0, 0, 2, 2, 1, 1, 2, 2, 2, 1],
        [0, 0, 0, 0, 0, 0, 0, 2, 1, 1, 2, 2, 1, 2, 2, 2],
        [0, 2, 2, 2, 0, 0, 2, 2, 0, 0, 1, 2, 0, 0, 1, 1],
        [0, 0, 1, 1, 0, 0, 1, 2, 0, 0, 2, 2, 0, 2, 2, 2],
        [0, 1, 2, 0, 0, 1, 2, 0, 0, 1, 2, 0, 0, 1, 2, 0],
        [0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 0, 0, 0, 0],
        [0, 1, 2, 0, 1, 2, 0, 1, 2, 0, 1, 2, 0, 1, 2, 0],
        [0, 1, 2, 0, 2, 0, 1, 2, 1, 2, 0, 1, 0, 1, 2, 0],
        [0, 0, 1, 1, 2, 2, 0, 0, 1, 1, 2, 2, 0, 0, 1, 1],
        [0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 0, 0, 0, 0, 1, 1],
        [0, 1, 0, 1, 0, 1, 0, 1, 2, 2, 2, 2, 2, 2, 2, 2],
        [0, 0, 0, 0, 0, 0, 0, 0, 2, 1, 2, 1, 2, 1, 2, 1],
        [0, 0, 2, 2, 1, 1, 2, 2, 0, 0, 2, 2, 1, 1, 2, 2],
        [0, 0, 2, 2, 0, 0, 1, 1, 0, 0, 2, 2, 0, 0, 1, 1],
        [0, 2, 2, 0, 1, 2, 2, 1, 0, 2, 2, 0, 1, 2, 2, 1],
        [0, 1, 0, 1, 2, 2, 2, 2, 2, 2, 2, 2, 0, 1, 0, 1],
        [0, 0, 0, 0, 2, 1, 2, 1, 2, 1, 2, 1, 2, 1, 2, 1],
        [0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 2, 2, 2, 2],
        [0, 2, 2, 2, 0, 1, 1, 1, 0, 2, 2, 2, 0, 1, 1, 1],
        [0, 0, 0, 2, 1, 1, 1, 2, 0, 0, 0, 2, 1, 1, 1, 2],
        [0, 0, 0, 0, 2, 1, 1, 2, 2, 1, 1, 2, 2, 1, 1, 2],
        [0, 2, 2, 2, 0, 1, 1, 1, 0, 1, 1, 1, 0, 2, 2, 2],
        [0, 0, 0, 2, 1, 1, 1, 2, 1, 1, 1, 2, 0, 0, 0, 2],
        [0, 1, 1, 0, 0, 1, 1, 0, 0, 1, 1, 0, 2, 2, 2, 2],
        [0, 0, 0, 0, 0, 0, 0, 0, 2, 1, 1, 2, 2, 1, 1, 2],
        [0, 1, 1, 0, 0, 1, 1, 0, 2, 2, 2, 2, 2, 2, 2, 2],
        [0, 0, 2, 2, 0, 0, 1, 1, 0, 0, 1, 1, 0, 0, 2, 2],
        [0, 0, 2, 2, 1, 1, 2, 2, 1, 1, 2, 2, 0, 0, 2, 2],
        [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2, 1, 1, 2],
        [0, 0, 0, 2, 0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 1],
        [0, 2, 2, 2, 1, 2, 2, 2, 0, 2, 2, 2, 1, 2, 2, 2],
        [0, 1, 0, 1, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2],
        [0, 1, 1, 1, 2, 0, 1, 1, 2, 2, 0, 1, 2, 2, 2, 0],
    ],
];

/// Fix-up pixel positions, indexed by
/// `[partition_count - 1][shape][partition]`.
#[rustfmt::skip]
pub static FIXUP_TABLE: [[[u8; 3]; 64]; 3] = [
    // One region: the anchor is always pixel 0.
    [[0; 3]; 64],

    // Two regions.
    [
        [0, 15, 0], [0, 15, 0], [0, 15, 0], [0, 15, 0],
        [0, 15, 0], [0, 15, 0], [0, 15, 0], [0, 15, 0],
        [0, 15, 0], [0, 15, 0], [0, 15, 0], [0, 15, 0],
        [0, 15, 0], [0, 15, 0], [0, 15, 0], [0, 15, 0],
        [0, 15, 0], [0, 2, 0], [0, 8, 0], [0, 2, 0],
        [0, 2, 0], [0, 8, 0], [0, 8, 0], [0, 15, 0],
        [0, 2, 0], [0, 8, 0], [0, 2, 0], [0, 2, 0],
        [0, 8, 0], [0, 8, 0], [0, 2, 0], [0, 2, 0],
        [0, 15, 0], [0, 15, 0], [0, 6, 0], [0, 8, 0],
        [0, 2, 0], [0, 8, 0], [0, 15, 0], [0, 15, 0],
        [0, 2, 0], [0, 8, 0], [0, 2, 0], [0, 2, 0],
        [0, 2, 0], [0, 15, 0], [0, 15, 0], [0, 6, 0],
        [0, 6, 0], [0, 2, 0], [0, 6, 0], [0, 8, 0],
        [0, 15, 0], [0, 15, 0], [0, 2, 0], [0, 2, 0],
        [0, 15, 0], [0, 15, 0], [0, 15, 0], [0, 15, 0],
        [0, 15, 0], [0, 2, 0], [0, 2, 0], [0, 15, 0],
    ],

    // Three regions.
    [
        [0, 3, 15], [0, 3, 8], [0, 15, 8], [0, 15, 3],
        [0, 8, 15], [0, 3, 15], [0, 15, 3], [0, 15, 8],
        [0, 8, 15], [0, 8, 15], [0, 6, 15], [0, 6, 15],
        [0, 6, 15], [0, 5, 15], [0, 3, 15], [0, 3, 8],
        [0, 3, 15], [0, 3, 8], [0, 8, 15], [0, 15, 3],
        [0, 3, 15], [0, 3, 8], [0, 6, 15], [0, 10, 8],
        [0, 5, 3], [0, 8, 15], [0, 8, 6], [0, 6, 10],
        [0, 8, 15], [0, 5, 15], [0, 15, 10], [0, 15, 8],
        [0, 8, 15], [0, 15, 3], [0, 3, 15], [0, 5, 10],
        [0, 6, 10], [0, 10, 8], [0, 8, 9], [0, 15, 10],
        [0, 15, 6], [0, 3, 15], [0, 15, 8], [0, 5, 15],
        [0, 15, 3], [0, 15, 6], [0, 15, 6], [0, 15, 8],
        [0, 3, 15], [0, 15, 3], [0, 5, 15], [0, 5, 15],
        [0, 5, 15], [0, 8, 15], [0, 5, 15], [0, 10, 15],
        [0, 5, 15], [0, 10, 15], [0, 8, 15], [0, 13, 15],
        [0, 15, 3], [0, 12, 15], [0, 3, 15], [0, 3, 8],
    ],
];

/// Whether pixel `offset` is a fix-up (anchor) position for the given
/// shape. Anchor indices are stored with one fewer bit.
#[inline]
#[must_use]
pub fn is_fixup_offset(partitions: usize, shape: usize, offset: usize) -> bool {
    debug_assert!(partitions < 3 && shape < 64 && offset < 16);
    FIXUP_TABLE[partitions][shape]
        .iter()
        .take(partitions + 1)
        .any(|&f| usize::from(f) == offset)
}

/// Weighted palette interpolation of the RGB channels.
#[inline]
#[must_use]
pub fn interpolate_rgb(c0: LdrColor, c1: LdrColor, wc: usize, wcprec: usize) -> LdrColor {
    let w = weights(wcprec)[wc];
    let mix = |a: u8, b: u8| -> u8 {
        ((i32::from(a) * (WEIGHT_MAX - w) + i32::from(b) * w + WEIGHT_ROUND) >> WEIGHT_SHIFT) as u8
    };
    LdrColor::new(mix(c0.r, c1.r), mix(c0.g, c1.g), mix(c0.b, c1.b), 0)
}

/// Weighted palette interpolation of the alpha channel only.
#[inline]
#[must_use]
pub fn interpolate_a(c0: LdrColor, c1: LdrColor, wa: usize, waprec: usize) -> u8 {
    let w = weights(waprec)[wa];
    ((i32::from(c0.a) * (WEIGHT_MAX - w) + i32::from(c1.a) * w + WEIGHT_ROUND) >> WEIGHT_SHIFT)
        as u8
}

/// Weighted palette interpolation of all four channels, with separate
/// colour and alpha weights.
#[inline]
#[must_use]
pub fn interpolate(
    c0: LdrColor,
    c1: LdrColor,
    wc: usize,
    wa: usize,
    wcprec: usize,
    waprec: usize,
) -> LdrColor {
    let mut out = interpolate_rgb(c0, c1, wc, wcprec);
    out.a = interpolate_a(c0, c1, wa, waprec);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_rows_are_valid() {
        for (parts, plane) in PARTITION_TABLE.iter().enumerate() {
            for row in plane {
                for &p in row {
                    assert!(usize::from(p) <= parts);
                }
            }
        }
    }

    #[test]
    fn test_fixups_land_in_their_partition() {
        for parts in 0..3usize {
            for shape in 0..64usize {
                for p in 0..=parts {
                    let fix = usize::from(FIXUP_TABLE[parts][shape][p]);
                    assert_eq!(
                        usize::from(PARTITION_TABLE[parts][shape][fix]),
                        p,
                        "parts {parts} shape {shape} partition {p}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_weight_tables_span_full_range() {
        assert_eq!(*WEIGHTS2.last().unwrap(), WEIGHT_MAX);
        assert_eq!(*WEIGHTS3.last().unwrap(), WEIGHT_MAX);
        assert_eq!(*WEIGHTS4.last().unwrap(), WEIGHT_MAX);
        assert_eq!(WEIGHTS2[0] | WEIGHTS3[0] | WEIGHTS4[0], 0);
    }

    #[test]
    fn test_interpolate_endpoints_exact() {
        let a = LdrColor::new(10, 20, 30, 40);
        let b = LdrColor::new(250, 240, 230, 220);
        let lo = interpolate(a, b, 0, 0, 3, 3);
        assert_eq!((lo.r, lo.g, lo.b, lo.a), (10, 20, 30, 40));
        let hi = interpolate(a, b, 7, 7, 3, 3);
        assert_eq!((hi.r, hi.g, hi.b, hi.a), (250, 240, 230, 220));
    }

    #[test]
    fn test_fixup_offset_query() {
        assert!(is_fixup_offset(0, 0, 0));
        assert!(!is_fixup_offset(0, 0, 5));
        assert!(is_fixup_offset(1, 0, 15));
        assert!(is_fixup_offset(2, 0, 3));
    }
}
