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

//! BC6H block compression (HDR RGB, 16 bytes per block, no alpha).
//!
//! Fourteen modes share one 128-bit container. Modes 1–10 carry two
//! endpoint pairs over a 5-bit shape selector with 3-bit indices;
//! modes 11–14 carry a single pair with 4-bit indices. Each mode's bit
//! layout is irregular, so emission and decoding walk a descriptor
//! table mapping every header bit position to `(field, bit_index)`.
//!
//! The encoder scores every shape of every mode with a cheap estimate,
//! keeps the best quarter, and refines those with a per-channel
//! logarithmic perturbation search. Decoding of malformed blocks never
//! fails: reserved modes and overruns produce opaque black per the
//! format specification.

use super::{
    is_fixup_offset, PARTITION_TABLE, WEIGHTS3, WEIGHTS4, WEIGHT_MAX, WEIGHT_ROUND, WEIGHT_SHIFT,
};
use crate::bits::BitBuffer;
use crate::optimize::optimize_rgb;
use crate::pixel::{IntColor, IntEndpoints, LdrColor, Rgba, BLOCK_PIXELS, F16MAX};
use log::debug;

const MAX_REGIONS: usize = 2;
const MAX_SHAPES: usize = 32;
const MAX_INDICES: usize = 16;

/// Target of one descriptor-table bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    /// Unused position (modes with a 65-bit header).
    NA,
    /// Mode identifier bit.
    M,
    /// Shape selector bit.
    D,
    RW,
    RX,
    RY,
    RZ,
    GW,
    GX,
    GY,
    GZ,
    BW,
    BX,
    BY,
    BZ,
}

use Field::{BW, BX, BY, BZ, D, GW, GX, GY, GZ, M, NA, RW, RX, RY, RZ};

const MODE_DESCRIPTORS: [[(Field, u8); 82]; 14] = [
    // Mode 1 (0x00) - 10 5 5 5
    [
        (M, 0), (M, 1), (GY, 4), (BY, 4), (BZ, 4), (RW, 0), (RW, 1), (RW, 2), (RW, 3), (RW, 4),
        (RW, 5), (RW, 6), (RW, 7), (RW, 8), (RW, 9), (GW, 0), (GW, 1), (GW, 2), (GW, 3), (GW, 4),
        (GW, 5), (GW, 6), (GW, 7), (GW, 8), (GW, 9), (BW, 0), (BW, 1), (BW, 2), (BW, 3), (BW, 4),
        (BW, 5), (BW, 6), (BW, 7), (BW, 8), (BW, 9), (RX, 0), (RX, 1), (RX, 2), (RX, 3), (RX, 4),
        (GZ, 4), (GY, 0), (GY, 1), (GY, 2), (GY, 3), (GX, 0), (GX, 1), (GX, 2), (GX, 3), (GX, 4),
        (BZ, 0), (GZ, 0), (GZ, 1), (GZ, 2), (GZ, 3), (BX, 0), (BX, 1), (BX, 2), (BX, 3), (BX, 4),
        (BZ, 1), (BY, 0), (BY, 1), (BY, 2), (BY, 3), (RY, 0), (RY, 1), (RY, 2), (RY, 3), (RY, 4),
        (BZ, 2), (RZ, 0), (RZ, 1), (RZ, 2), (RZ, 3), (RZ, 4), (BZ, 3), (D, 0), (D, 1), (D, 2),
        (D, 3), (D, 4)
    ],
    // Mode 2 (0x01) - 7 6 6 6
    [
        (M, 0), (M, 1), (GY, 5), (GZ, 4), (GZ, 5), (RW, 0), (RW, 1), (RW, 2), (RW, 3), (RW, 4),
        (RW, 5), (RW, 6), (BZ, 0), (BZ, 1), (BY, 4), (GW, 0), (GW, 1), (GW, 2), (GW, 3), (GW, 4),
        (GW, 5), (GW, 6), (BY, 5), (BZ, 2), (GY, 4), (BW, 0), (BW, 1), (BW, 2), (BW, 3), (BW, 4),
        (BW, 5), (BW, 6), (BZ, 3), (BZ, 5), (BZ, 4), (RX, 0), (RX, 1), (RX, 2), (RX, 3), (RX, 4),
        (RX, 5), (GY, 0), (GY, 1), (GY, 2), (GY, 3), (GX, 0), (GX, 1), (GX, 2), (GX, 3), (GX, 4),
        (GX, 5), (GZ, 0), (GZ, 1), (GZ, 2), (GZ, 3), (BX, 0), (BX, 1), (BX, 2), (BX, 3), (BX, 4),
        (BX, 5), (BY, 0), (BY, 1), (BY, 2), (BY, 3), (RY, 0), (RY, 1), (RY, 2), (RY, 3), (RY, 4),
        (RY, 5), (RZ, 0), (RZ, 1), (RZ, 2), (RZ, 3), (RZ, 4), (RZ, 5), (D, 0), (D, 1), (D, 2),
        (D, 3), (D, 4)
    ],
    // Mode 3 (0x02) - 11 5 4 4
    [
        (M, 0), (M, 1), (M, 2), (M, 3), (M, 4), (RW, 0), (RW, 1), (RW, 2), (RW, 3), (RW, 4),
        (RW, 5), (RW, 6), (RW, 7), (RW, 8), (RW, 9), (GW, 0), (GW, 1), (GW, 2), (GW, 3), (GW, 4),
        (GW, 5), (GW, 6), (GW, 7), (GW, 8), (GW, 9), (BW, 0), (BW, 1), (BW, 2), (BW, 3), (BW, 4),
        (BW, 5), (BW, 6), (BW, 7), (BW, 8), (BW, 9), (RX, 0), (RX, 1), (RX, 2), (RX, 3), (RX, 4),
        (RW, 10), (GY, 0), (GY, 1), (GY, 2), (GY, 3), (GX, 0), (GX, 1), (GX, 2), (GX, 3),
        (GW, 10), (BZ, 0), (GZ, 0), (GZ, 1), (GZ, 2), (GZ, 3), (BX, 0), (BX, 1), (BX, 2),
        (BX, 3), (BW, 10), (BZ, 1), (BY, 0), (BY, 1), (BY, 2), (BY, 3), (RY, 0), (RY, 1),
        (RY, 2), (RY, 3), (RY, 4), (BZ, 2), (RZ, 0), (RZ, 1), (RZ, 2), (RZ, 3), (RZ, 4), (BZ, 3),
        (D, 0), (D, 1), (D, 2), (D, 3), (D, 4)
    ],
    // Mode 4 (0x06) - 11 4 5 4
    [
        (M, 0), (M, 1), (M, 2), (M, 3), (M, 4), (RW, 0), (RW, 1), (RW, 2), (RW, 3), (RW, 4),
        (RW, 5), (RW, 6), (RW, 7), (RW, 8), (RW, 9), (GW, 0), (GW, 1), (GW, 2), (GW, 3), (GW, 4),
        (GW, 5), (GW, 6), (GW, 7), (GW, 8), (GW, 9), (BW, 0), (BW, 1), (BW, 2), (BW, 3), (BW, 4),
        (BW, 5), (BW, 6), (BW, 7), (BW, 8), (BW, 9), (RX, 0), (RX, 1), (RX, 2), (RX, 3),
        (RW, 10), (GZ, 4), (GY, 0), (GY, 1), (GY, 2), (GY, 3), (GX, 0), (GX, 1), (GX, 2),
        (GX, 3), (GX, 4), (GW, 10), (GZ, 0), (GZ, 1), (GZ, 2), (GZ, 3), (BX, 0), (BX, 1),
        (BX, 2), (BX, 3), (BW, 10), (BZ, 1), (BY, 0), (BY, 1), (BY, 2), (BY, 3), (RY, 0),
        (RY, 1), (RY, 2), (RY, 3), (BZ, 0), (BZ, 2), (RZ, 0), (RZ, 1), (RZ, 2), (RZ, 3), (GY, 4),
        (BZ, 3), (D, 0), (D, 1), (D, 2), (D, 3), (D, 4)
    ],
    // Mode 5 (0x0a) - 11 4 4 5
    [
        (M, 0), (M, 1), (M, 2), (M, 3), (M, 4), (RW, 0), (RW, 1), (RW, 2), (RW, 3), (RW, 4),
        (RW, 5), (RW, 6), (RW, 7), (RW, 8), (RW, 9), (GW, 0), (GW, 1), (GW, 2), (GW, 3), (GW, 4),
        (GW, 5), (GW, 6), (GW, 7), (GW, 8), (GW, 9), (BW, 0), (BW, 1), (BW, 2), (BW, 3), (BW, 4),
        (BW, 5), (BW, 6), (BW, 7), (BW, 8), (BW, 9), (RX, 0), (RX, 1), (RX, 2), (RX, 3),
        (RW, 10), (BY, 4), (GY, 0), (GY, 1), (GY, 2), (GY, 3), (GX, 0), (GX, 1), (GX, 2),
        (GX, 3), (GW, 10), (BZ, 0), (GZ, 0), (GZ, 1), (GZ, 2), (GZ, 3), (BX, 0), (BX, 1),
        (BX, 2), (BX, 3), (BX, 4), (BW, 10), (BY, 0), (BY, 1), (BY, 2), (BY, 3), (RY, 0),
        (RY, 1), (RY, 2), (RY, 3), (BZ, 1), (BZ, 2), (RZ, 0), (RZ, 1), (RZ, 2), (RZ, 3), (BZ, 4),
        (BZ, 3), (D, 0), (D, 1), (D, 2), (D, 3), (D, 4)
    ],
    // Mode 6 (0x0e) - 9 5 5 5
    [
        (M, 0), (M, 1), (M, 2), (M, 3), (M, 4), (RW, 0), (RW, 1), (RW, 2), (RW, 3), (RW, 4),
        (RW, 5), (RW, 6), (RW, 7), (RW, 8), (BY, 4), (GW, 0), (GW, 1), (GW, 2), (GW, 3), (GW, 4),
        (GW, 5), (GW, 6), (GW, 7), (GW, 8), (GY, 4), (BW, 0), (BW, 1), (BW, 2), (BW, 3), (BW, 4),
        (BW, 5), (BW, 6), (BW, 7), (BW, 8), (BZ, 4), (RX, 0), (RX, 1), (RX, 2), (RX, 3), (RX, 4),
        (GZ, 4), (GY, 0), (GY, 1), (GY, 2), (GY, 3), (GX, 0), (GX, 1), (GX, 2), (GX, 3), (GX, 4),
        (BZ, 0), (GZ, 0), (GZ, 1), (GZ, 2), (GZ, 3), (BX, 0), (BX, 1), (BX, 2), (BX, 3), (BX, 4),
        (BZ, 1), (BY, 0), (BY, 1), (BY, 2), (BY, 3), (RY, 0), (RY, 1), (RY, 2), (RY, 3), (RY, 4),
        (BZ, 2), (RZ, 0), (RZ, 1), (RZ, 2), (RZ, 3), (RZ, 4), (BZ, 3), (D, 0), (D, 1), (D, 2),
        (D, 3), (D, 4)
    ],
    // Mode 7 (0x12) - 8 6 5 5
    [
        (M, 0), (M, 1), (M, 2), (M, 3), (M, 4), (RW, 0), (RW, 1), (RW, 2), (RW, 3), (RW, 4),
        (RW, 5), (RW, 6), (RW, 7), (GZ, 4), (BY, 4), (GW, 0), (GW, 1), (GW, 2), (GW, 3), (GW, 4),
        (GW, 5), (GW, 6), (GW, 7), (BZ, 2), (GY, 4), (BW, 0), (BW, 1), (BW, 2), (BW, 3), (BW, 4),
        (BW, 5), (BW, 6), (BW, 7), (BZ, 3), (BZ, 4), (RX, 0), (RX, 1), (RX, 2), (RX, 3), (RX, 4),
        (RX, 5), (GY, 0), (GY, 1), (GY, 2), (GY, 3), (GX, 0), (GX, 1), (GX, 2), (GX, 3), (GX, 4),
        (BZ, 0), (GZ, 0), (GZ, 1), (GZ, 2), (GZ, 3), (BX, 0), (BX, 1), (BX, 2), (BX, 3), (BX, 4),
        (BZ, 1), (BY, 0), (BY, 1), (BY, 2), (BY, 3), (RY, 0), (RY, 1), (RY, 2), (RY, 3), (RY, 4),
        (RY, 5), (RZ, 0), (RZ, 1), (RZ, 2), (RZ, 3), (RZ, 4), (RZ, 5), (D, 0), (D, 1), (D, 2),
        (D, 3), (D, 4)
    ],
    // Mode 8 (0x16) - 8 5 6 5
    [
        (M, 0), (M, 1), (M, 2), (M, 3), (M, 4), (RW, 0), (RW, 1), (RW, 2), (RW, 3), (RW, 4),
        (RW, 5), (RW, 6), (RW, 7), (BZ, 0), (BY, 4), (GW, 0), (GW, 1), (GW, 2), (GW, 3), (GW, 4),
        (GW, 5), (GW, 6), (GW, 7), (GY, 5), (GY, 4), (BW, 0), (BW, 1), (BW, 2), (BW, 3), (BW, 4),
        (BW, 5), (BW, 6), (BW, 7), (GZ, 5), (BZ, 4), (RX, 0), (RX, 1), (RX, 2), (RX, 3), (RX, 4),
        (GZ, 4), (GY, 0), (GY, 1), (GY, 2), (GY, 3), (GX, 0), (GX, 1), (GX, 2), (GX, 3), (GX, 4),
        (GX, 5), (GZ, 0), (GZ, 1), (GZ, 2), (GZ, 3), (BX, 0), (BX, 1), (BX, 2), (BX, 3), (BX, 4),
        (BZ, 1), (BY, 0), (BY, 1), (BY, 2), (BY, 3), (RY, 0), (RY, 1), (RY, 2), (RY, 3), (RY, 4),
        (BZ, 2), (RZ, 0), (RZ, 1), (RZ, 2), (RZ, 3), (RZ, 4), (BZ, 3), (D, 0), (D, 1), (D, 2),
        (D, 3), (D, 4)
    ],
    // Mode 9 (0x1a) - 8 5 5 6
    [
        (M, 0), (M, 1), (M, 2), (M, 3), (M, 4), (RW, 0), (RW, 1), (RW, 2), (RW, 3), (RW, 4),
        (RW, 5), (RW, 6), (RW, 7), (BZ, 1), (BY, 4), (GW, 0), (GW, 1), (GW, 2), (GW, 3), (GW, 4),
        (GW, 5), (GW, 6), (GW, 7), (BY, 5), (GY, 4), (BW, 0), (BW, 1), (BW, 2), (BW, 3), (BW, 4),
        (BW, 5), (BW, 6), (BW, 7), (BZ, 5), (BZ, 4), (RX, 0), (RX, 1), (RX, 2), (RX, 3), (RX, 4),
        (GZ, 4), (GY, 0), (GY, 1), (GY, 2), (GY, 3), (GX, 0), (GX, 1), (GX, 2), (GX, 3), (GX, 4),
        (BZ, 0), (GZ, 0), (GZ, 1), (GZ, 2), (GZ, 3), (BX, 0), (BX, 1), (BX, 2), (BX, 3), (BX, 4),
        (BX, 5), (BY, 0), (BY, 1), (BY, 2), (BY, 3), (RY, 0), (RY, 1), (RY, 2), (RY, 3), (RY, 4),
        (BZ, 2), (RZ, 0), (RZ, 1), (RZ, 2), (RZ, 3), (RZ, 4), (BZ, 3), (D, 0), (D, 1), (D, 2),
        (D, 3), (D, 4)
    ],
    // Mode 10 (0x1e) - 6 6 6 6
    [
        (M, 0), (M, 1), (M, 2), (M, 3), (M, 4), (RW, 0), (RW, 1), (RW, 2), (RW, 3), (RW, 4),
        (RW, 5), (GZ, 4), (BZ, 0), (BZ, 1), (BY, 4), (GW, 0), (GW, 1), (GW, 2), (GW, 3), (GW, 4),
        (GW, 5), (GY, 5), (BY, 5), (BZ, 2), (GY, 4), (BW, 0), (BW, 1), (BW, 2), (BW, 3), (BW, 4),
        (BW, 5), (GZ, 5), (BZ, 3), (BZ, 5), (BZ, 4), (RX, 0), (RX, 1), (RX, 2), (RX, 3), (RX, 4),
        (RX, 5), (GY, 0), (GY, 1), (GY, 2), (GY, 3), (GX, 0), (GX, 1), (GX, 2), (GX, 3), (GX, 4),
        (GX, 5), (GZ, 0), (GZ, 1), (GZ, 2), (GZ, 3), (BX, 0), (BX, 1), (BX, 2), (BX, 3), (BX, 4),
        (BX, 5), (BY, 0), (BY, 1), (BY, 2), (BY, 3), (RY, 0), (RY, 1), (RY, 2), (RY, 3), (RY, 4),
        (RY, 5), (RZ, 0), (RZ, 1), (RZ, 2), (RZ, 3), (RZ, 4), (RZ, 5), (D, 0), (D, 1), (D, 2),
        (D, 3), (D, 4)
    ],
    // Mode 11 (0x03) - 10 10
    [
        (M, 0), (M, 1), (M, 2), (M, 3), (M, 4), (RW, 0), (RW, 1), (RW, 2), (RW, 3), (RW, 4),
        (RW, 5), (RW, 6), (RW, 7), (RW, 8), (RW, 9), (GW, 0), (GW, 1), (GW, 2), (GW, 3), (GW, 4),
        (GW, 5), (GW, 6), (GW, 7), (GW, 8), (GW, 9), (BW, 0), (BW, 1), (BW, 2), (BW, 3), (BW, 4),
        (BW, 5), (BW, 6), (BW, 7), (BW, 8), (BW, 9), (RX, 0), (RX, 1), (RX, 2), (RX, 3), (RX, 4),
        (RX, 5), (RX, 6), (RX, 7), (RX, 8), (RX, 9), (GX, 0), (GX, 1), (GX, 2), (GX, 3), (GX, 4),
        (GX, 5), (GX, 6), (GX, 7), (GX, 8), (GX, 9), (BX, 0), (BX, 1), (BX, 2), (BX, 3), (BX, 4),
        (BX, 5), (BX, 6), (BX, 7), (BX, 8), (BX, 9), (NA, 0), (NA, 0), (NA, 0), (NA, 0), (NA, 0),
        (NA, 0), (NA, 0), (NA, 0), (NA, 0), (NA, 0), (NA, 0), (NA, 0), (NA, 0), (NA, 0), (NA, 0),
        (NA, 0), (NA, 0)
    ],
    // Mode 12 (0x07) - 11 9
    [
        (M, 0), (M, 1), (M, 2), (M, 3), (M, 4), (RW, 0), (RW, 1), (RW, 2), (RW, 3), (RW, 4),
        (RW, 5), (RW, 6), (RW, 7), (RW, 8), (RW, 9), (GW, 0), (GW, 1), (GW, 2), (GW, 3), (GW, 4),
        (GW, 5), (GW, 6), (GW, 7), (GW, 8), (GW, 9), (BW, 0), (BW, 1), (BW, 2), (BW, 3), (BW, 4),
        (BW, 5), (BW, 6), (BW, 7), (BW, 8), (BW, 9), (RX, 0), (RX, 1), (RX, 2), (RX, 3), (RX, 4),
        (RX, 5), (RX, 6), (RX, 7), (RX, 8), (RW, 10), (GX, 0), (GX, 1), (GX, 2), (GX, 3),
        (GX, 4), (GX, 5), (GX, 6), (GX, 7), (GX, 8), (GW, 10), (BX, 0), (BX, 1), (BX, 2),
        (BX, 3), (BX, 4), (BX, 5), (BX, 6), (BX, 7), (BX, 8), (BW, 10), (NA, 0), (NA, 0),
        (NA, 0), (NA, 0), (NA, 0), (NA, 0), (NA, 0), (NA, 0), (NA, 0), (NA, 0), (NA, 0), (NA, 0),
        (NA, 0), (NA, 0), (NA, 0), (NA, 0), (NA, 0)
    ],
    // Mode 13 (0x0b) - 12 8
    [
        (M, 0), (M, 1), (M, 2), (M, 3), (M, 4), (RW, 0), (RW, 1), (RW, 2), (RW, 3), (RW, 4),
        (RW, 5), (RW, 6), (RW, 7), (RW, 8), (RW, 9), (GW, 0), (GW, 1), (GW, 2), (GW, 3), (GW, 4),
        (GW, 5), (GW, 6), (GW, 7), (GW, 8), (GW, 9), (BW, 0), (BW, 1), (BW, 2), (BW, 3), (BW, 4),
        (BW, 5), (BW, 6), (BW, 7), (BW, 8), (BW, 9), (RX, 0), (RX, 1), (RX, 2), (RX, 3), (RX, 4),
        (RX, 5), (RX, 6), (RX, 7), (RW, 11), (RW, 10), (GX, 0), (GX, 1), (GX, 2), (GX, 3),
        (GX, 4), (GX, 5), (GX, 6), (GX, 7), (GW, 11), (GW, 10), (BX, 0), (BX, 1), (BX, 2),
        (BX, 3), (BX, 4), (BX, 5), (BX, 6), (BX, 7), (BW, 11), (BW, 10), (NA, 0), (NA, 0),
        (NA, 0), (NA, 0), (NA, 0), (NA, 0), (NA, 0), (NA, 0), (NA, 0), (NA, 0), (NA, 0), (NA, 0),
        (NA, 0), (NA, 0), (NA, 0), (NA, 0), (NA, 0)
    ],
    // Mode 14 (0x0f) - 16 4
    [
        (M, 0), (M, 1), (M, 2), (M, 3), (M, 4), (RW, 0), (RW, 1), (RW, 2), (RW, 3), (RW, 4),
        (RW, 5), (RW, 6), (RW, 7), (RW, 8), (RW, 9), (GW, 0), (GW, 1), (GW, 2), (GW, 3), (GW, 4),
        (GW, 5), (GW, 6), (GW, 7), (GW, 8), (GW, 9), (BW, 0), (BW, 1), (BW, 2), (BW, 3), (BW, 4),
        (BW, 5), (BW, 6), (BW, 7), (BW, 8), (BW, 9), (RX, 0), (RX, 1), (RX, 2), (RX, 3),
        (RW, 15), (RW, 14), (RW, 13), (RW, 12), (RW, 11), (RW, 10), (GX, 0), (GX, 1), (GX, 2),
        (GX, 3), (GW, 15), (GW, 14), (GW, 13), (GW, 12), (GW, 11), (GW, 10), (BX, 0), (BX, 1),
        (BX, 2), (BX, 3), (BW, 15), (BW, 14), (BW, 13), (BW, 12), (BW, 11), (BW, 10), (NA, 0),
        (NA, 0), (NA, 0), (NA, 0), (NA, 0), (NA, 0), (NA, 0), (NA, 0), (NA, 0), (NA, 0), (NA, 0),
        (NA, 0), (NA, 0), (NA, 0), (NA, 0), (NA, 0), (NA, 0)
    ],
];

/// Per-mode layout parameters: wire mode bits, region count minus one,
/// whether endpoints 1–3 are stored as deltas, index width, and the
/// endpoint channel precisions per region and endpoint.
struct ModeInfo {
    mode: u8,
    partitions: usize,
    transformed: bool,
    index_prec: usize,
    prec: [[LdrColor; 2]; 2],
}

const fn rgb(r: u8, g: u8, b: u8) -> LdrColor {
    LdrColor::new(r, g, b, 0)
}

#[rustfmt::skip]
const MODE_INFO: [ModeInfo; 14] = [
    ModeInfo { mode: 0x00, partitions: 1, transformed: true,  index_prec: 3, prec: [[rgb(10, 10, 10), rgb(5, 5, 5)], [rgb(5, 5, 5), rgb(5, 5, 5)]] },
    ModeInfo { mode: 0x01, partitions: 1, transformed: true,  index_prec: 3, prec: [[rgb(7, 7, 7),    rgb(6, 6, 6)], [rgb(6, 6, 6), rgb(6, 6, 6)]] },
    ModeInfo { mode: 0x02, partitions: 1, transformed: true,  index_prec: 3, prec: [[rgb(11, 11, 11), rgb(5, 4, 4)], [rgb(5, 4, 4), rgb(5, 4, 4)]] },
    ModeInfo { mode: 0x06, partitions: 1, transformed: true,  index_prec: 3, prec: [[rgb(11, 11, 11), rgb(4, 5, 4)], [rgb(4, 5, 4), rgb(4, 5, 4)]] },
    ModeInfo { mode: 0x0a, partitions: 1, transformed: true,  index_prec: 3, prec: [[rgb(11, 11, 11), rgb(4, 4, 5)], [rgb(4, 4, 5), rgb(4, 4, 5)]] },
    ModeInfo { mode: 0x0e, partitions: 1, transformed: true,  index_prec: 3, prec: [[rgb(9, 9, 9),    rgb(5, 5, 5)], [rgb(5, 5, 5), rgb(5, 5, 5)]] },
    ModeInfo { mode: 0x12, partitions: 1, transformed: true,  index_prec: 3, prec: [[rgb(8, 8, 8),    rgb(6, 5, 5)], [rgb(6, 5, 5), rgb(6, 5, 5)]] },
    ModeInfo { mode: 0x16, partitions: 1, transformed: true,  index_prec: 3, prec: [[rgb(8, 8, 8),    rgb(5, 6, 5)], [rgb(5, 6, 5), rgb(5, 6, 5)]] },
    ModeInfo { mode: 0x1a, partitions: 1, transformed: true,  index_prec: 3, prec: [[rgb(8, 8, 8),    rgb(5, 5, 6)], [rgb(5, 5, 6), rgb(5, 5, 6)]] },
    ModeInfo { mode: 0x1e, partitions: 1, transformed: false, index_prec: 3, prec: [[rgb(6, 6, 6),    rgb(6, 6, 6)], [rgb(6, 6, 6), rgb(6, 6, 6)]] },
    ModeInfo { mode: 0x03, partitions: 0, transformed: false, index_prec: 4, prec: [[rgb(10, 10, 10), rgb(10, 10, 10)], [rgb(0, 0, 0), rgb(0, 0, 0)]] },
    ModeInfo { mode: 0x07, partitions: 0, transformed: true,  index_prec: 4, prec: [[rgb(11, 11, 11), rgb(9, 9, 9)], [rgb(0, 0, 0), rgb(0, 0, 0)]] },
    ModeInfo { mode: 0x0b, partitions: 0, transformed: true,  index_prec: 4, prec: [[rgb(12, 12, 12), rgb(8, 8, 8)], [rgb(0, 0, 0), rgb(0, 0, 0)]] },
    ModeInfo { mode: 0x0f, partitions: 0, transformed: true,  index_prec: 4, prec: [[rgb(16, 16, 16), rgb(4, 4, 4)], [rgb(0, 0, 0), rgb(0, 0, 0)]] },
];

/// Maps the 5-bit wire mode to an index in [`MODE_INFO`], or -1 for
/// invalid and reserved encodings.
#[rustfmt::skip]
const MODE_TO_INFO: [i8; 32] = [
     0,  1,  2, 10, -1, -1,  3, 11,
    -1, -1,  4, 12, -1, -1,  5, 13,
    -1, -1,  6, -1, -1, -1,  7, -1,
    -1, -1,  8, -1, -1, -1,  9, -1,
];

fn transform_forward(endpoints: &mut [IntEndpoints; MAX_REGIONS]) {
    let base = endpoints[0].a;
    endpoints[0].b -= base;
    endpoints[1].a -= base;
    endpoints[1].b -= base;
}

fn transform_inverse(endpoints: &mut [IntEndpoints; MAX_REGIONS], prec: LdrColor, signed: bool) {
    let wrap = IntColor::new(
        (1 << prec.r) - 1,
        (1 << prec.g) - 1,
        (1 << prec.b) - 1,
    );
    let base = endpoints[0].a;
    let wrap_add = |mut c: IntColor| {
        c += base;
        c.r &= wrap.r;
        c.g &= wrap.g;
        c.b &= wrap.b;
        c
    };
    endpoints[0].b = wrap_add(endpoints[0].b);
    endpoints[1].a = wrap_add(endpoints[1].a);
    endpoints[1].b = wrap_add(endpoints[1].b);
    if signed {
        endpoints[0].b = endpoints[0].b.sign_extend(prec);
        endpoints[1].a = endpoints[1].a.sign_extend(prec);
        endpoints[1].b = endpoints[1].b.sign_extend(prec);
    }
}

/// Bits needed to store `n`, counting a sign bit when required.
fn nbits(n: i32, signed: bool) -> i32 {
    if n == 0 {
        0
    } else if n > 0 {
        let mut nb = 0;
        let mut v = n;
        while v != 0 {
            nb += 1;
            v >>= 1;
        }
        nb + i32::from(signed)
    } else {
        debug_assert!(signed);
        let mut nb = 0;
        let mut v = n;
        while v < -1 {
            nb += 1;
            v >>= 1;
        }
        nb + 1
    }
}

fn quantize(value: i32, prec: i32, signed: bool) -> i32 {
    debug_assert!(prec > 1);
    if signed {
        debug_assert!(value >= -F16MAX && value <= F16MAX);
        let (s, v) = if value < 0 { (true, -value) } else { (false, value) };
        let q = if prec >= 16 {
            v
        } else {
            (v << (prec - 1)) / (F16MAX + 1)
        };
        if s {
            -q
        } else {
            q
        }
    } else {
        debug_assert!(value >= 0 && value <= F16MAX);
        if prec >= 15 {
            value
        } else {
            (value << prec) / (F16MAX + 1)
        }
    }
}

fn unquantize(comp: i32, bits: u8, signed: bool) -> i32 {
    let bits = i32::from(bits);
    if signed {
        if bits >= 16 {
            comp
        } else {
            let (s, c) = if comp < 0 { (true, -comp) } else { (false, comp) };
            let unq = if c == 0 {
                0
            } else if c >= (1 << (bits - 1)) - 1 {
                0x7fff
            } else {
                ((c << 15) + 0x4000) >> (bits - 1)
            };
            if s {
                -unq
            } else {
                unq
            }
        }
    } else if bits >= 15 {
        comp
    } else if comp == 0 {
        0
    } else if comp == (1 << bits) - 1 {
        0xffff
    } else {
        ((comp << 16) + 0x8000) >> bits
    }
}

fn finish_unquantize(comp: i32, signed: bool) -> i32 {
    if signed {
        // Scale the magnitude by 31/32.
        if comp < 0 {
            -(((-comp) * 31) >> 5)
        } else {
            (comp * 31) >> 5
        }
    } else {
        // Scale the magnitude by 31/64.
        (comp * 31) >> 6
    }
}

/// Decodes a BC6H block (16 bytes) to 16 HDR pixels.
///
/// A malformed block (reserved mode, header bit landing on an unused
/// descriptor slot, or a read past bit 128) decodes to opaque black
/// for every pixel, as the format requires.
#[must_use]
pub fn decode_bc6h(block: &[u8; 16], signed: bool) -> [Rgba; BLOCK_PIXELS] {
    let buf = BitBuffer::from_bytes(*block);
    let mut cursor = 0usize;

    let mut mode = buf.get_bits(&mut cursor, 2);
    if mode != 0x00 && mode != 0x01 {
        mode = (buf.get_bits(&mut cursor, 3) << 2) | mode;
    }

    let info_index = MODE_TO_INFO[mode as usize];
    if info_index < 0 {
        match mode {
            0x13 | 0x17 | 0x1b | 0x1f => debug!("reserved mode {mode:#04x} in block"),
            _ => debug!("invalid mode {mode:#04x} in block"),
        }
        return [Rgba::BLACK; BLOCK_PIXELS];
    }
    let desc = &MODE_DESCRIPTORS[info_index as usize];
    let info = &MODE_INFO[info_index as usize];

    let mut endpoints = [IntEndpoints::default(); MAX_REGIONS];
    let mut shape = 0usize;

    // Scatter header bits into endpoint components per the descriptor.
    let header_bits = if info.partitions > 0 { 82 } else { 65 };
    while cursor < header_bits {
        let cur = cursor;
        if buf.get_bit(&mut cursor) != 0 {
            let bit = 1i32 << desc[cur].1;
            match desc[cur].0 {
                D => shape |= 1 << desc[cur].1,
                RW => endpoints[0].a.r |= bit,
                RX => endpoints[0].b.r |= bit,
                RY => endpoints[1].a.r |= bit,
                RZ => endpoints[1].b.r |= bit,
                GW => endpoints[0].a.g |= bit,
                GX => endpoints[0].b.g |= bit,
                GY => endpoints[1].a.g |= bit,
                GZ => endpoints[1].b.g |= bit,
                BW => endpoints[0].a.b |= bit,
                BX => endpoints[0].b.b |= bit,
                BY => endpoints[1].a.b |= bit,
                BZ => endpoints[1].b.b |= bit,
                M | NA => {
                    debug!("invalid header bit {cur} in block");
                    return [Rgba::BLACK; BLOCK_PIXELS];
                }
            }
        }
    }
    debug_assert!(shape < 64);

    // Sign extension of the stored fields.
    if signed {
        endpoints[0].a = endpoints[0].a.sign_extend(info.prec[0][0]);
    }
    if signed || info.transformed {
        for p in 0..=info.partitions {
            if p != 0 {
                endpoints[p].a = endpoints[p].a.sign_extend(info.prec[p][0]);
            }
            endpoints[p].b = endpoints[p].b.sign_extend(info.prec[p][1]);
        }
    }

    if info.transformed {
        transform_inverse(&mut endpoints, info.prec[0][0], signed);
    }

    let weights: &[i32] = if info.partitions > 0 { &WEIGHTS3 } else { &WEIGHTS4 };
    let prec = info.prec[0][0];
    let mut out = [Rgba::BLACK; BLOCK_PIXELS];
    for i in 0..BLOCK_PIXELS {
        let num_bits = if is_fixup_offset(info.partitions, shape, i) {
            info.index_prec - 1
        } else {
            info.index_prec
        };
        if cursor + num_bits > 128 {
            debug!("index read past end of block");
            return [Rgba::BLACK; BLOCK_PIXELS];
        }
        let index = buf.get_bits(&mut cursor, num_bits) as usize;

        let region = usize::from(PARTITION_TABLE[info.partitions][shape][i]);

        let ep = &endpoints[region];
        let r1 = unquantize(ep.a.r, prec.r, signed);
        let g1 = unquantize(ep.a.g, prec.g, signed);
        let b1 = unquantize(ep.a.b, prec.b, signed);
        let r2 = unquantize(ep.b.r, prec.r, signed);
        let g2 = unquantize(ep.b.g, prec.g, signed);
        let b2 = unquantize(ep.b.b, prec.b, signed);

        let w = weights[index];
        let fc = IntColor::new(
            finish_unquantize((r1 * (WEIGHT_MAX - w) + r2 * w + WEIGHT_ROUND) >> WEIGHT_SHIFT, signed),
            finish_unquantize((g1 * (WEIGHT_MAX - w) + g2 * w + WEIGHT_ROUND) >> WEIGHT_SHIFT, signed),
            finish_unquantize((b1 * (WEIGHT_MAX - w) + b2 * w + WEIGHT_ROUND) >> WEIGHT_SHIFT, signed),
        );
        out[i] = fc.to_rgba(signed);
    }
    out
}

/// Per-call search context for one block encode.
struct Bc6hEncoder<'a> {
    pixels: &'a [Rgba; BLOCK_PIXELS],
    ipixels: [IntColor; BLOCK_PIXELS],
    signed: bool,
    mode: usize,
    shape: usize,
    best_err: f32,
    block: BitBuffer,
    unq: [[IntEndpoints; MAX_REGIONS]; MAX_SHAPES],
}

impl<'a> Bc6hEncoder<'a> {
    fn new(pixels: &'a [Rgba; BLOCK_PIXELS], signed: bool) -> Self {
        let mut ipixels = [IntColor::default(); BLOCK_PIXELS];
        for (ip, p) in ipixels.iter_mut().zip(pixels.iter()) {
            *ip = IntColor::from_rgba(*p, signed);
        }
        Self {
            pixels,
            ipixels,
            signed,
            mode: 0,
            shape: 0,
            best_err: f32::MAX,
            block: BitBuffer::new(),
            unq: [[IntEndpoints::default(); MAX_REGIONS]; MAX_SHAPES],
        }
    }

    fn info(&self) -> &'static ModeInfo {
        &MODE_INFO[self.mode]
    }

    fn endpoints_fit(&self, endpoints: &[IntEndpoints; MAX_REGIONS]) -> bool {
        let info = self.info();
        let transformed = info.transformed;
        let signed = self.signed;

        let fits = |c: IntColor, prec: LdrColor, signed_bits: bool| {
            nbits(c.r, signed_bits) <= i32::from(prec.r)
                && nbits(c.g, signed_bits) <= i32::from(prec.g)
                && nbits(c.b, signed_bits) <= i32::from(prec.b)
        };

        if !fits(endpoints[0].a, info.prec[0][0], signed)
            || !fits(endpoints[0].b, info.prec[0][1], transformed || signed)
        {
            return false;
        }
        if info.partitions > 0
            && (!fits(endpoints[1].a, info.prec[1][0], transformed || signed)
                || !fits(endpoints[1].b, info.prec[1][1], transformed || signed))
        {
            return false;
        }
        true
    }

    fn generate_palette_quantized(
        &self,
        endpoints: &IntEndpoints,
        palette: &mut [IntColor; MAX_INDICES],
    ) {
        let info = self.info();
        let num_indices = 1usize << info.index_prec;
        let prec = info.prec[0][0];

        let a = IntColor::new(
            unquantize(endpoints.a.r, prec.r, self.signed),
            unquantize(endpoints.a.g, prec.g, self.signed),
            unquantize(endpoints.a.b, prec.b, self.signed),
        );
        let b = IntColor::new(
            unquantize(endpoints.b.r, prec.r, self.signed),
            unquantize(endpoints.b.g, prec.g, self.signed),
            unquantize(endpoints.b.b, prec.b, self.signed),
        );

        let weights: &[i32] = if info.index_prec == 3 { &WEIGHTS3 } else { &WEIGHTS4 };
        for (i, entry) in palette.iter_mut().enumerate().take(num_indices) {
            let w = weights[i];
            *entry = IntColor::new(
                finish_unquantize(
                    (a.r * (WEIGHT_MAX - w) + b.r * w + WEIGHT_ROUND) >> WEIGHT_SHIFT,
                    self.signed,
                ),
                finish_unquantize(
                    (a.g * (WEIGHT_MAX - w) + b.g * w + WEIGHT_ROUND) >> WEIGHT_SHIFT,
                    self.signed,
                ),
                finish_unquantize(
                    (a.b * (WEIGHT_MAX - w) + b.b * w + WEIGHT_ROUND) >> WEIGHT_SHIFT,
                    self.signed,
                ),
            );
        }
    }

    fn map_colors_quantized(&self, colors: &[IntColor], endpoints: &IntEndpoints) -> f32 {
        let num_indices = 1usize << self.info().index_prec;
        let mut palette = [IntColor::default(); MAX_INDICES];
        self.generate_palette_quantized(endpoints, &mut palette);

        let mut total = 0.0f32;
        for &c in colors {
            let mut best = c.norm_sq(palette[0]);
            for entry in palette.iter().take(num_indices).skip(1) {
                if best <= 0.0 {
                    break;
                }
                let err = c.norm_sq(*entry);
                if err > best {
                    // Palette entries march along the axis, so the error
                    // only grows from here.
                    break;
                }
                best = err;
            }
            total += best;
        }
        total
    }

    fn perturb_one(
        &self,
        colors: &[IntColor],
        ch: usize,
        old_endpoints: &IntEndpoints,
        new_endpoints: &mut IntEndpoints,
        old_err: f32,
        do_b: bool,
    ) -> f32 {
        let prec = i32::from(self.info().prec[0][0][ch]);
        let mut tmp = *old_endpoints;
        *new_endpoints = *old_endpoints;
        let mut min_err = old_err;

        let mut step = 1 << (prec - 1);
        while step != 0 {
            let mut improved = false;
            let mut best_step = 0;
            for sign in [-1i32, 1] {
                let base = if do_b {
                    new_endpoints.b[ch]
                } else {
                    new_endpoints.a[ch]
                };
                let value = base + sign * step;
                if value < 0 || value >= (1 << prec) {
                    continue;
                }
                if do_b {
                    tmp.b[ch] = value;
                } else {
                    tmp.a[ch] = value;
                }

                let err = self.map_colors_quantized(colors, &tmp);
                if err < min_err {
                    improved = true;
                    min_err = err;
                    best_step = sign * step;
                }
            }
            if improved {
                if do_b {
                    new_endpoints.b[ch] += best_step;
                } else {
                    new_endpoints.a[ch] += best_step;
                }
            }
            step >>= 1;
        }
        min_err
    }

    fn optimize_one(
        &self,
        colors: &[IntColor],
        org_err: f32,
        org_endpoints: &IntEndpoints,
        opt_endpoints: &mut IntEndpoints,
    ) {
        let mut opt_err = org_err;
        *opt_endpoints = *org_endpoints;

        for ch in 0..3 {
            // Perturbing whichever endpoint helps most first avoids
            // settling into a local minimum when strictly alternating.
            let mut new_a = IntEndpoints::default();
            let mut new_b = IntEndpoints::default();
            let err0 = self.perturb_one(colors, ch, opt_endpoints, &mut new_a, opt_err, false);
            let err1 = self.perturb_one(colors, ch, opt_endpoints, &mut new_b, opt_err, true);

            let mut do_b;
            if err0 < err1 {
                if err0 >= opt_err {
                    continue;
                }
                opt_endpoints.a[ch] = new_a.a[ch];
                opt_err = err0;
                do_b = true;
            } else {
                if err1 >= opt_err {
                    continue;
                }
                opt_endpoints.b[ch] = new_b.b[ch];
                opt_err = err1;
                do_b = false;
            }

            loop {
                let mut new_ep = IntEndpoints::default();
                let err = self.perturb_one(colors, ch, opt_endpoints, &mut new_ep, opt_err, do_b);
                if err >= opt_err {
                    break;
                }
                if do_b {
                    opt_endpoints.b[ch] = new_ep.b[ch];
                } else {
                    opt_endpoints.a[ch] = new_ep.a[ch];
                }
                opt_err = err;
                do_b = !do_b;
            }
        }
    }

    fn optimize_endpoints(
        &self,
        org_err: &[f32; MAX_REGIONS],
        org: &[IntEndpoints; MAX_REGIONS],
        opt: &mut [IntEndpoints; MAX_REGIONS],
    ) {
        let partitions = self.info().partitions;
        let mut region_pixels = [IntColor::default(); BLOCK_PIXELS];

        for p in 0..=partitions {
            let mut np = 0;
            for i in 0..BLOCK_PIXELS {
                if usize::from(PARTITION_TABLE[partitions][self.shape][i]) == p {
                    region_pixels[np] = self.ipixels[i];
                    np += 1;
                }
            }
            self.optimize_one(&region_pixels[..np], org_err[p], &org[p], &mut opt[p]);
        }
    }

    /// Swaps endpoints where needed so the fix-up pixel of each region
    /// has a zero high-order index bit.
    fn swap_indices(
        &self,
        endpoints: &mut [IntEndpoints; MAX_REGIONS],
        indices: &mut [usize; BLOCK_PIXELS],
    ) {
        let info = self.info();
        let partitions = info.partitions;
        let num_indices = 1usize << info.index_prec;
        let high_bit = num_indices >> 1;

        for p in 0..=partitions {
            let fix = usize::from(super::FIXUP_TABLE[partitions][self.shape][p]);
            debug_assert_eq!(usize::from(PARTITION_TABLE[partitions][self.shape][fix]), p);
            if indices[fix] & high_bit != 0 {
                std::mem::swap(&mut endpoints[p].a, &mut endpoints[p].b);
                for (j, idx) in indices.iter_mut().enumerate() {
                    if usize::from(PARTITION_TABLE[partitions][self.shape][j]) == p {
                        *idx = num_indices - 1 - *idx;
                    }
                }
            }
        }
    }

    fn assign_indices(
        &self,
        endpoints: &[IntEndpoints; MAX_REGIONS],
        indices: &mut [usize; BLOCK_PIXELS],
        total_err: &mut [f32; MAX_REGIONS],
    ) {
        let info = self.info();
        let partitions = info.partitions;
        let num_indices = 1usize << info.index_prec;

        let mut palette = [[IntColor::default(); MAX_INDICES]; MAX_REGIONS];
        for p in 0..=partitions {
            self.generate_palette_quantized(&endpoints[p], &mut palette[p]);
            total_err[p] = 0.0;
        }

        for i in 0..BLOCK_PIXELS {
            let region = usize::from(PARTITION_TABLE[partitions][self.shape][i]);
            let mut best = self.ipixels[i].norm_sq(palette[region][0]);
            indices[i] = 0;
            for j in 1..num_indices {
                if best <= 0.0 {
                    break;
                }
                let err = self.ipixels[i].norm_sq(palette[region][j]);
                if err > best {
                    break;
                }
                if err < best {
                    best = err;
                    indices[i] = j;
                }
            }
            total_err[region] += best;
        }
    }

    fn quantize_endpoints(&self, quantized: &mut [IntEndpoints; MAX_REGIONS]) {
        let info = self.info();
        let prec = info.prec[0][0];
        let unq = &self.unq[self.shape];

        for p in 0..=info.partitions {
            quantized[p].a = IntColor::new(
                quantize(unq[p].a.r, i32::from(prec.r), self.signed),
                quantize(unq[p].a.g, i32::from(prec.g), self.signed),
                quantize(unq[p].a.b, i32::from(prec.b), self.signed),
            );
            quantized[p].b = IntColor::new(
                quantize(unq[p].b.r, i32::from(prec.r), self.signed),
                quantize(unq[p].b.g, i32::from(prec.g), self.signed),
                quantize(unq[p].b.b, i32::from(prec.b), self.signed),
            );
        }
    }

    fn emit_block(
        &mut self,
        endpoints: &[IntEndpoints; MAX_REGIONS],
        indices: &[usize; BLOCK_PIXELS],
    ) {
        let info = self.info();
        let real_mode = info.mode;
        let partitions = info.partitions;
        let index_prec = info.index_prec;
        let header_bits = if partitions > 0 { 82 } else { 65 };
        let desc = &MODE_DESCRIPTORS[self.mode];
        let shape = self.shape;
        let mut block = BitBuffer::new();
        let mut cursor = 0usize;

        while cursor < header_bits {
            let (field, bit) = desc[cursor];
            let value = match field {
                M => (real_mode >> bit) & 0x01,
                D => ((shape >> bit) & 0x01) as u8,
                RW => ((endpoints[0].a.r >> bit) & 0x01) as u8,
                RX => ((endpoints[0].b.r >> bit) & 0x01) as u8,
                RY => ((endpoints[1].a.r >> bit) & 0x01) as u8,
                RZ => ((endpoints[1].b.r >> bit) & 0x01) as u8,
                GW => ((endpoints[0].a.g >> bit) & 0x01) as u8,
                GX => ((endpoints[0].b.g >> bit) & 0x01) as u8,
                GY => ((endpoints[1].a.g >> bit) & 0x01) as u8,
                GZ => ((endpoints[1].b.g >> bit) & 0x01) as u8,
                BW => ((endpoints[0].a.b >> bit) & 0x01) as u8,
                BX => ((endpoints[0].b.b >> bit) & 0x01) as u8,
                BY => ((endpoints[1].a.b >> bit) & 0x01) as u8,
                BZ => ((endpoints[1].b.b >> bit) & 0x01) as u8,
                NA => unreachable!("header overruns descriptor"),
            };
            block.set_bit(&mut cursor, value);
        }

        for (i, &index) in indices.iter().enumerate() {
            if is_fixup_offset(partitions, shape, i) {
                block.set_bits(&mut cursor, index_prec - 1, index as u8);
            } else {
                block.set_bits(&mut cursor, index_prec, index as u8);
            }
        }
        debug_assert_eq!(cursor, 128);
        self.block = block;
    }

    fn refine(&mut self) {
        let info = self.info();
        let partitions = info.partitions;
        let transformed = info.transformed;
        let prec0 = info.prec[0][0];

        let mut org_err = [0.0f32; MAX_REGIONS];
        let mut opt_err = [0.0f32; MAX_REGIONS];
        let mut org_endpoints = [IntEndpoints::default(); MAX_REGIONS];
        let mut opt_endpoints = [IntEndpoints::default(); MAX_REGIONS];
        let mut org_idx = [0usize; BLOCK_PIXELS];
        let mut opt_idx = [0usize; BLOCK_PIXELS];

        self.quantize_endpoints(&mut org_endpoints);
        self.assign_indices(&org_endpoints, &mut org_idx, &mut org_err);
        self.swap_indices(&mut org_endpoints, &mut org_idx);

        if transformed {
            transform_forward(&mut org_endpoints);
        }
        if !self.endpoints_fit(&org_endpoints) {
            return;
        }
        if transformed {
            transform_inverse(&mut org_endpoints, prec0, self.signed);
        }
        self.optimize_endpoints(&org_err, &org_endpoints, &mut opt_endpoints);
        self.assign_indices(&opt_endpoints, &mut opt_idx, &mut opt_err);
        self.swap_indices(&mut opt_endpoints, &mut opt_idx);

        let mut org_total = 0.0f32;
        let mut opt_total = 0.0f32;
        for p in 0..=partitions {
            org_total += org_err[p];
            opt_total += opt_err[p];
        }

        if transformed {
            transform_forward(&mut opt_endpoints);
        }
        if self.endpoints_fit(&opt_endpoints) && opt_total < org_total && opt_total < self.best_err
        {
            self.best_err = opt_total;
            self.emit_block(&opt_endpoints, &opt_idx);
        } else if org_total < self.best_err {
            // The optimised endpoints either stopped fitting or did not
            // improve; fall back to the unoptimised pair, which fits.
            if transformed {
                transform_forward(&mut org_endpoints);
            }
            self.best_err = org_total;
            self.emit_block(&org_endpoints, &org_idx);
        }
    }

    fn generate_palette_unquantized(&self, region: usize, palette: &mut [IntColor; MAX_INDICES]) {
        let info = self.info();
        let endpoints = &self.unq[self.shape][region];
        let num_indices = 1usize << info.index_prec;
        let weights: &[i32] = if info.index_prec == 3 { &WEIGHTS3 } else { &WEIGHTS4 };

        for (i, entry) in palette.iter_mut().enumerate().take(num_indices) {
            let w = weights[i];
            *entry = IntColor::new(
                (endpoints.a.r * (WEIGHT_MAX - w) + endpoints.b.r * w + WEIGHT_ROUND)
                    >> WEIGHT_SHIFT,
                (endpoints.a.g * (WEIGHT_MAX - w) + endpoints.b.g * w + WEIGHT_ROUND)
                    >> WEIGHT_SHIFT,
                (endpoints.a.b * (WEIGHT_MAX - w) + endpoints.b.b * w + WEIGHT_ROUND)
                    >> WEIGHT_SHIFT,
            );
        }
    }

    fn map_colors(&self, region: usize, pixel_indices: &[usize]) -> f32 {
        let num_indices = 1usize << self.info().index_prec;
        let mut palette = [IntColor::default(); MAX_INDICES];
        self.generate_palette_unquantized(region, &mut palette);

        let mut total = 0.0f32;
        for &pi in pixel_indices {
            let mut best = self.ipixels[pi].norm_sq(palette[0]);
            for entry in palette.iter().take(num_indices).skip(1) {
                if best <= 0.0 {
                    break;
                }
                let err = self.ipixels[pi].norm_sq(*entry);
                if err > best {
                    break;
                }
                if err < best {
                    best = err;
                }
            }
            total += best;
        }
        total
    }

    /// Cheap error estimate for the current mode and shape; also seeds
    /// the unquantized endpoints used by refinement.
    fn rough_mse(&mut self) -> f32 {
        let partitions = self.info().partitions;
        let shape = self.shape;
        let signed = self.signed;
        let mut pix_idx = [0usize; BLOCK_PIXELS];

        let mut error = 0.0f32;
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
                self.unq[shape][p].a = self.ipixels[pix_idx[0]];
                self.unq[shape][p].b = self.ipixels[pix_idx[0]];
                continue;
            }
            if np == 2 {
                self.unq[shape][p].a = self.ipixels[pix_idx[0]];
                self.unq[shape][p].b = self.ipixels[pix_idx[1]];
                continue;
            }

            let (ep_a, ep_b) = optimize_rgb(self.pixels, 4, &pix_idx[..np]);
            self.unq[shape][p].a = IntColor::from_rgba(ep_a, signed);
            self.unq[shape][p].b = IntColor::from_rgba(ep_b, signed);
            if signed {
                self.unq[shape][p].a = self.unq[shape][p].a.clamp(-F16MAX, F16MAX);
                self.unq[shape][p].b = self.unq[shape][p].b.clamp(-F16MAX, F16MAX);
            } else {
                self.unq[shape][p].a = self.unq[shape][p].a.clamp(0, F16MAX);
                self.unq[shape][p].b = self.unq[shape][p].b.clamp(0, F16MAX);
            }

            error += self.map_colors(p, &pix_idx[..np]);
        }
        error
    }
}

/// Encodes 16 HDR pixels as a BC6H block (16 bytes).
///
/// The emitted block is the lowest-error candidate among the shapes
/// and modes the search visits; the search is best-effort, not
/// exhaustive.
#[must_use]
pub fn encode_bc6h(pixels: &[Rgba; BLOCK_PIXELS], signed: bool) -> [u8; 16] {
    let mut enc = Bc6hEncoder::new(pixels, signed);

    for mode in 0..MODE_INFO.len() {
        if enc.best_err <= 0.0 {
            break;
        }
        enc.mode = mode;
        let shapes = if MODE_INFO[mode].partitions > 0 {
            MAX_SHAPES
        } else {
            1
        };
        // Refining every shape is wasteful; the best quarter of the
        // rough estimates captures nearly all of the win.
        let items = (shapes >> 2).max(1);

        let mut rough = [0.0f32; MAX_SHAPES];
        let mut order = [0usize; MAX_SHAPES];
        for shape in 0..shapes {
            enc.shape = shape;
            rough[shape] = enc.rough_mse();
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
            if enc.best_err <= 0.0 {
                break;
            }
            enc.shape = shape;
            enc.refine();
        }
    }

    enc.block.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantize_unquantize_zero() {
        for signed in [false, true] {
            assert_eq!(quantize(0, 10, signed), 0);
            assert_eq!(unquantize(0, 10, signed), 0);
            assert_eq!(finish_unquantize(0, signed), 0);
        }
    }

    #[test]
    fn test_quantize_full_precision_passthrough() {
        assert_eq!(quantize(0x1234, 16, false), 0x1234);
        assert_eq!(unquantize(0x1234, 16, true), 0x1234);
    }

    #[test]
    fn test_unquantize_saturates_max_code() {
        assert_eq!(unquantize((1 << 10) - 1, 10, false), 0xffff);
        assert_eq!(unquantize((1 << 9) - 1, 10, true), 0x7fff);
    }

    #[test]
    fn test_zero_block_round_trip() {
        for signed in [false, true] {
            let block = encode_bc6h(&[Rgba::BLACK; 16], signed);
            let decoded = decode_bc6h(&block, signed);
            for p in decoded {
                assert_eq!((p.r, p.g, p.b, p.a), (0.0, 0.0, 0.0, 1.0), "signed={signed}");
            }
        }
    }

    #[test]
    fn test_solid_block_round_trip() {
        let pixels = [Rgba::new(0.5, 1.5, 4.0, 1.0); 16];
        for signed in [false, true] {
            let block = encode_bc6h(&pixels, signed);
            let decoded = decode_bc6h(&block, signed);
            for p in decoded {
                assert!((p.r - 0.5).abs() < 0.05, "signed={signed} r={}", p.r);
                assert!((p.g - 1.5).abs() < 0.1, "signed={signed} g={}", p.g);
                assert!((p.b - 4.0).abs() < 0.25, "signed={signed} b={}", p.b);
                assert_eq!(p.a, 1.0);
            }
        }
    }

    #[test]
    fn test_gradient_block_round_trip() {
        let mut pixels = [Rgba::BLACK; 16];
        for (i, p) in pixels.iter_mut().enumerate() {
            let t = i as f32 / 15.0;
            *p = Rgba::new(t * 2.0, 1.0 - t, 0.5 + t, 1.0);
        }
        let block = encode_bc6h(&pixels, false);
        let decoded = decode_bc6h(&block, false);
        for (i, p) in decoded.iter().enumerate() {
            assert!((p.r - pixels[i].r).abs() < 0.25, "pixel {i} r");
            assert!((p.g - pixels[i].g).abs() < 0.25, "pixel {i} g");
            assert!((p.b - pixels[i].b).abs() < 0.25, "pixel {i} b");
        }
    }

    #[test]
    fn test_reserved_mode_decodes_to_opaque_black() {
        // Mode bits 10011 (0x13) are reserved.
        let mut bytes = [0u8; 16];
        bytes[0] = 0x13;
        let decoded = decode_bc6h(&bytes, false);
        for p in decoded {
            assert_eq!((p.r, p.g, p.b, p.a), (0.0, 0.0, 0.0, 1.0));
        }
    }

    #[test]
    fn test_signed_negative_round_trip() {
        let pixels = [Rgba::new(-0.5, -1.0, 0.25, 1.0); 16];
        let block = encode_bc6h(&pixels, true);
        let decoded = decode_bc6h(&block, true);
        for p in decoded {
            assert!((p.r + 0.5).abs() < 0.05, "r={}", p.r);
            assert!((p.g + 1.0).abs() < 0.1, "g={}", p.g);
            assert!((p.b - 0.25).abs() < 0.05, "b={}", p.b);
        }
    }
}
