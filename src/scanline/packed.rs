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

//! Packed float encodings and the sRGB transfer functions.
//!
//! Everything here is explicit bit manipulation over
//! `f32::to_bits`/`from_bits`: the 5-bit-exponent small floats of
//! R11G11B10, the 9-bit shared-exponent triple of R9G9B9E5, and the
//! Xbox 7e3/6e4 back-buffer formats. All of these are positive-only
//! encodings; negative inputs saturate to zero and NaN propagates as
//! the all-ones code where the format can express it.

use crate::pixel::Rgba;

/// sRGB to linear transfer for one channel.
#[inline]
#[must_use]
pub fn srgb_to_linear(c: f32) -> f32 {
    let c = c.clamp(0.0, 1.0);
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Linear to sRGB transfer for one channel.
#[inline]
#[must_use]
pub fn linear_to_srgb(c: f32) -> f32 {
    let c = c.clamp(0.0, 1.0);
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

/// Applies [`srgb_to_linear`] to the colour channels, leaving alpha
/// untouched.
#[inline]
#[must_use]
pub fn srgb_to_linear_rgb(c: Rgba) -> Rgba {
    Rgba::new(
        srgb_to_linear(c.r),
        srgb_to_linear(c.g),
        srgb_to_linear(c.b),
        c.a,
    )
}

/// Applies [`linear_to_srgb`] to the colour channels, leaving alpha
/// untouched.
#[inline]
#[must_use]
pub fn linear_to_srgb_rgb(c: Rgba) -> Rgba {
    Rgba::new(
        linear_to_srgb(c.r),
        linear_to_srgb(c.g),
        linear_to_srgb(c.b),
        c.a,
    )
}

/// Converts a float to an unsigned small float with a 5-bit exponent
/// (bias 15) and `mbits` mantissa bits, round-to-nearest-even.
///
/// Negative values and -inf collapse to 0; +inf keeps its exponent
/// code; NaN becomes the all-ones code; large finite values saturate
/// to the largest finite code.
#[must_use]
pub fn f32_to_small_float(value: f32, mbits: u32) -> u32 {
    let bits = value.to_bits();
    let sign = bits & 0x8000_0000;
    let mut i = bits & 0x7fff_ffff;
    let shift = 23 - mbits;
    let mantissa_mask = (1u32 << mbits) - 1;

    if (i & 0x7f80_0000) == 0x7f80_0000 {
        if i & 0x007f_ffff != 0 {
            return (0x1f << mbits) | mantissa_mask;
        }
        return if sign != 0 { 0 } else { 0x1f << mbits };
    }
    if sign != 0 {
        return 0;
    }

    // Largest finite target value, as f32 bits.
    let max_finite = 0x4700_0000 | (mantissa_mask << shift);
    if i > max_finite {
        return (0x1e << mbits) | mantissa_mask;
    }

    if i < 0x3880_0000 {
        // Denormalized in the target format.
        let sh = 113 - (i >> 23);
        i = (0x0080_0000 | (i & 0x007f_ffff)) >> sh;
    } else {
        // Rebias the exponent from 127 to 15.
        i = i.wrapping_add(0xc800_0000);
    }

    let round = (1u32 << (shift - 1)) - 1;
    ((i.wrapping_add(round).wrapping_add((i >> shift) & 1)) >> shift) & ((1 << (mbits + 5)) - 1)
}

/// Converts an unsigned small float (5-bit exponent, `mbits` mantissa
/// bits) back to `f32`.
#[must_use]
pub fn small_float_to_f32(value: u32, mbits: u32) -> f32 {
    let mut mantissa = value & ((1 << mbits) - 1);
    let mut exponent = (value >> mbits) & 0x1f;

    if exponent == 0x1f {
        return f32::from_bits(0x7f80_0000 | (mantissa << (23 - mbits)));
    }
    if exponent != 0 {
        // Normalized.
    } else if mantissa != 0 {
        // Normalize the denormalized value.
        exponent = 1;
        loop {
            exponent = exponent.wrapping_sub(1);
            mantissa <<= 1;
            if mantissa & (1 << mbits) != 0 {
                break;
            }
        }
        mantissa &= (1 << mbits) - 1;
    } else {
        exponent = 0u32.wrapping_sub(112);
    }

    f32::from_bits((exponent.wrapping_add(112) << 23) | (mantissa << (23 - mbits)))
}

/// Packs three positive floats into the R11G11B10 layout.
#[must_use]
pub fn pack_r11g11b10(r: f32, g: f32, b: f32) -> u32 {
    f32_to_small_float(r, 6) | (f32_to_small_float(g, 6) << 11) | (f32_to_small_float(b, 5) << 22)
}

/// Unpacks the R11G11B10 layout.
#[must_use]
pub fn unpack_r11g11b10(v: u32) -> (f32, f32, f32) {
    (
        small_float_to_f32(v & 0x7ff, 6),
        small_float_to_f32((v >> 11) & 0x7ff, 6),
        small_float_to_f32(v >> 22, 5),
    )
}

/// Packs three positive floats into the R9G9B9E5 shared-exponent
/// layout: 9-bit mantissas and a 5-bit exponent computed from the
/// largest channel.
#[must_use]
pub fn pack_rgb9e5(r: f32, g: f32, b: f32) -> u32 {
    const MAX_F9: f32 = (0x1ff << 7) as f32;
    const MIN_F9: f32 = 1.0 / (1 << 16) as f32;

    let sat = |v: f32| {
        if v.is_nan() || v < 0.0 {
            0.0
        } else if v > MAX_F9 {
            MAX_F9
        } else {
            v
        }
    };
    let x = sat(r);
    let y = sat(g);
    let z = sat(b);

    let max_color = x.max(y).max(z).max(MIN_F9);

    // Round the shared scale up so 9 fraction bits survive, then build
    // the reciprocal scale from the chosen exponent.
    let mut fi = max_color.to_bits() as i32;
    fi += 0x0000_4000;
    let exp = fi >> 23;
    let e = (exp - 0x6f) as u32;
    let scale = f32::from_bits(0x8300_0000u32.wrapping_sub((exp as u32) << 23));

    let xm = (x * scale).round_ties_even() as u32;
    let ym = (y * scale).round_ties_even() as u32;
    let zm = (z * scale).round_ties_even() as u32;

    (xm & 0x1ff) | ((ym & 0x1ff) << 9) | ((zm & 0x1ff) << 18) | (e << 27)
}

/// Unpacks the R9G9B9E5 shared-exponent layout.
#[must_use]
pub fn unpack_rgb9e5(v: u32) -> (f32, f32, f32) {
    let e = (v >> 27) & 0x1f;
    let scale = f32::from_bits((e + 103) << 23); // 2^(e - 24)
    (
        (v & 0x1ff) as f32 * scale,
        ((v >> 9) & 0x1ff) as f32 * scale,
        ((v >> 18) & 0x1ff) as f32 * scale,
    )
}

/// Converts a float to the Xbox 7e3 format (7-bit mantissa, 3-bit
/// exponent, positive only).
#[must_use]
pub fn f32_to_7e3(value: f32) -> u32 {
    let mut i = value.to_bits();

    if i & 0x8000_0000 != 0 {
        // Positive only.
        0
    } else if i > 0x41ff_73ff {
        // Too large; saturate.
        0x3ff
    } else {
        if i < 0x3e80_0000 {
            // Denormalized 7e3.
            let shift = 125 - (i >> 23);
            i = (0x0080_0000 | (i & 0x007f_ffff)) >> shift;
        } else {
            // Rebias the exponent.
            i = i.wrapping_add(0xc200_0000);
        }
        ((i.wrapping_add(0x7fff).wrapping_add((i >> 16) & 1)) >> 16) & 0x3ff
    }
}

/// Converts a 7e3-encoded value back to a float.
#[must_use]
pub fn f32_from_7e3(value: u32) -> f32 {
    let mut mantissa = value & 0x7f;
    let mut exponent = value & 0x380;
    if exponent != 0 {
        exponent = (value >> 7) & 0x7;
    } else if mantissa != 0 {
        exponent = 1;
        loop {
            exponent = exponent.wrapping_sub(1);
            mantissa <<= 1;
            if mantissa & 0x80 != 0 {
                break;
            }
        }
        mantissa &= 0x7f;
    } else {
        exponent = 0u32.wrapping_sub(124);
    }

    f32::from_bits((exponent.wrapping_add(124) << 23) | (mantissa << 16))
}

/// Converts a float to the Xbox 6e4 format (6-bit mantissa, 4-bit
/// exponent, positive only).
#[must_use]
pub fn f32_to_6e4(value: f32) -> u32 {
    let mut i = value.to_bits();

    if i & 0x8000_0000 != 0 {
        0
    } else if i > 0x43fe_ffff {
        0x3ff
    } else {
        if i < 0x3c80_0000 {
            let shift = 121 - (i >> 23);
            i = (0x0080_0000 | (i & 0x007f_ffff)) >> shift;
        } else {
            i = i.wrapping_add(0xc400_0000);
        }
        ((i.wrapping_add(0xffff).wrapping_add((i >> 17) & 1)) >> 17) & 0x3ff
    }
}

/// Converts a 6e4-encoded value back to a float.
#[must_use]
pub fn f32_from_6e4(value: u32) -> f32 {
    let mut mantissa = value & 0x3f;
    let mut exponent = value & 0x3c0;
    if exponent != 0 {
        exponent = (value >> 6) & 0xf;
    } else if mantissa != 0 {
        exponent = 1;
        loop {
            exponent = exponent.wrapping_sub(1);
            mantissa <<= 1;
            if mantissa & 0x40 != 0 {
                break;
            }
        }
        mantissa &= 0x3f;
    } else {
        exponent = 0u32.wrapping_sub(120);
    }

    f32::from_bits((exponent.wrapping_add(120) << 23) | (mantissa << 17))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_srgb_round_trip_within_one_code() {
        // Every 8-bit code survives the round trip within one code.
        for i in 0..=255u32 {
            let x = i as f32 / 255.0;
            let rt = srgb_to_linear(linear_to_srgb(x));
            assert!((rt - x).abs() <= 1.0 / 255.0, "code {i}: {rt} vs {x}");
        }
    }

    #[test]
    fn test_srgb_fixed_points() {
        assert_eq!(srgb_to_linear(0.0), 0.0);
        assert_eq!(srgb_to_linear(1.0), 1.0);
        assert_eq!(linear_to_srgb(0.0), 0.0);
        assert_eq!(linear_to_srgb(1.0), 1.0);
    }

    #[test]
    fn test_small_float_exact_values() {
        // 1.0 = exponent 15, zero mantissa.
        assert_eq!(f32_to_small_float(1.0, 6), 0x0f << 6);
        assert_eq!(small_float_to_f32(0x0f << 6, 6), 1.0);
        assert_eq!(f32_to_small_float(0.0, 5), 0);
        assert_eq!(small_float_to_f32(0, 5), 0.0);
        // Negatives clamp to zero.
        assert_eq!(f32_to_small_float(-2.0, 6), 0);
    }

    #[test]
    fn test_small_float_round_trip() {
        for v in [0.5f32, 1.0, 2.0, 0.125, 100.0, 60000.0] {
            let rt = small_float_to_f32(f32_to_small_float(v, 6), 6);
            let rel = (rt - v).abs() / v.max(1e-6);
            assert!(rel < 1.0 / 32.0, "value {v}: {rt}");
        }
    }

    #[test]
    fn test_r11g11b10_pack_order() {
        let packed = pack_r11g11b10(1.0, 0.0, 0.0);
        assert_eq!(packed, 0x0f << 6);
        let (r, g, b) = unpack_r11g11b10(packed);
        assert_eq!((r, g, b), (1.0, 0.0, 0.0));
    }

    #[test]
    fn test_rgb9e5_round_trip() {
        for (r, g, b) in [(1.0f32, 0.5, 0.25), (0.0, 0.0, 0.0), (6.0, 3.0, 1.5)] {
            let (ur, ug, ub) = unpack_rgb9e5(pack_rgb9e5(r, g, b));
            assert!((ur - r).abs() <= r.max(1.0) / 256.0, "{r} -> {ur}");
            assert!((ug - g).abs() <= g.max(1.0) / 256.0, "{g} -> {ug}");
            assert!((ub - b).abs() <= b.max(1.0) / 256.0, "{b} -> {ub}");
        }
    }

    #[test]
    fn test_rgb9e5_negative_saturates_to_zero() {
        let (r, _, _) = unpack_rgb9e5(pack_rgb9e5(-1.0, 0.0, 0.0));
        assert_eq!(r, 0.0);
    }

    #[test]
    fn test_7e3_round_trip() {
        for v in [0.0f32, 0.5, 1.0, 2.0, 10.0, 31.0] {
            let rt = f32_from_7e3(f32_to_7e3(v));
            assert!((rt - v).abs() <= v.max(1.0) / 64.0, "value {v}: {rt}");
        }
        // Negative saturates to zero; huge saturates to the max code.
        assert_eq!(f32_to_7e3(-5.0), 0);
        assert_eq!(f32_to_7e3(1e9), 0x3ff);
    }

    #[test]
    fn test_6e4_round_trip() {
        for v in [0.0f32, 0.5, 1.0, 2.0, 100.0, 500.0] {
            let rt = f32_from_6e4(f32_to_6e4(v));
            assert!((rt - v).abs() <= v.max(1.0) / 32.0, "value {v}: {rt}");
        }
        assert_eq!(f32_to_6e4(-5.0), 0);
        assert_eq!(f32_to_6e4(1e9), 0x3ff);
    }
}
