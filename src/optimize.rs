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

//! Least-squares endpoint fitting.
//!
//! Every BC encoder reduces to the same subproblem: given a handful of
//! colour samples and a palette size `k`, find two endpoints whose
//! interpolated palette minimises the summed squared error. The
//! routines here implement that fit with Newton iterations over the
//! per-endpoint partial derivatives:
//!
//! 1. seed the endpoints with the componentwise min/max of the samples;
//! 2. pick the best of the axis-flipped diagonals by projecting the
//!    samples onto each candidate direction;
//! 3. bail out early for single-colour and two-colour blocks;
//! 4. iterate up to eight times: rebuild the palette, assign each
//!    sample to its nearest step, then move each endpoint by
//!    `-gradient / second_derivative` per channel.
//!
//! The scalar variant drives the BC3/BC4/BC5 alpha ramps, where the
//! 6-step palette pins two extra entries to the range boundaries.

use crate::pixel::{Rgba, BLOCK_PIXELS};

const EPSILON: f32 = (0.25 / 64.0) * (0.25 / 64.0);
const C3: [f32; 4] = [2.0 / 2.0, 1.0 / 2.0, 0.0 / 2.0, 0.0];
const D3: [f32; 4] = [0.0 / 2.0, 1.0 / 2.0, 2.0 / 2.0, 0.0];
const C4: [f32; 4] = [3.0 / 3.0, 2.0 / 3.0, 1.0 / 3.0, 0.0 / 3.0];
const D4: [f32; 4] = [0.0 / 3.0, 1.0 / 3.0, 2.0 / 3.0, 3.0 / 3.0];

const C6: [f32; 8] = [5.0 / 5.0, 4.0 / 5.0, 3.0 / 5.0, 2.0 / 5.0, 1.0 / 5.0, 0.0 / 5.0, 0.0, 0.0];
const D6: [f32; 8] = [0.0 / 5.0, 1.0 / 5.0, 2.0 / 5.0, 3.0 / 5.0, 4.0 / 5.0, 5.0 / 5.0, 0.0, 0.0];
#[rustfmt::skip]
const C8: [f32; 8] = [7.0 / 7.0, 6.0 / 7.0, 5.0 / 7.0, 4.0 / 7.0, 3.0 / 7.0, 2.0 / 7.0, 1.0 / 7.0, 0.0 / 7.0];
#[rustfmt::skip]
const D8: [f32; 8] = [0.0 / 7.0, 1.0 / 7.0, 2.0 / 7.0, 3.0 / 7.0, 4.0 / 7.0, 5.0 / 7.0, 6.0 / 7.0, 7.0 / 7.0];

/// Fits RGB endpoints to the given subset of a 16-pixel block.
///
/// `indices` selects which of the block's pixels participate; BC6H and
/// BC7 pass the pixels of one partition. `steps` is the palette size,
/// 3 or 4. Alpha is ignored. Returns the endpoint pair `(x, y)`.
pub fn optimize_rgb(points: &[Rgba], steps: usize, indices: &[usize]) -> (Rgba, Rgba) {
    let (c, d) = if steps == 3 { (&C3, &D3) } else { (&C4, &D4) };

    // Seed with the componentwise bounding box.
    let mut x = Rgba::new(1.0, 1.0, 1.0, 0.0);
    let mut y = Rgba::new(0.0, 0.0, 0.0, 0.0);
    for &i in indices {
        let p = points[i];
        if p.r < x.r { x.r = p.r; }
        if p.g < x.g { x.g = p.g; }
        if p.b < x.b { x.b = p.b; }
        if p.r > y.r { y.r = p.r; }
        if p.g > y.g { y.g = p.g; }
        if p.b > y.b { y.b = p.b; }
    }

    let ab = Rgba::new(y.r - x.r, y.g - x.g, y.b - x.b, 0.0);
    let f_ab = ab.r * ab.r + ab.g * ab.g + ab.b * ab.b;

    // Single colour block, nothing to fit.
    if f_ab < f32::MIN_POSITIVE {
        return (x, y);
    }

    choose_diagonal_rgb(points, indices, &mut x, &mut y, ab, f_ab);

    // Two colour block, the diagonal choice is the answer.
    if f_ab < 1.0 / 4096.0 {
        return (x, y);
    }

    // Newton iterations on the sum-of-squares error.
    let f_steps = (steps - 1) as f32;
    for _ in 0..8 {
        let mut palette = [Rgba::ZERO; 4];
        for (s, p) in palette.iter_mut().enumerate().take(steps) {
            p.r = x.r * c[s] + y.r * d[s];
            p.g = x.g * c[s] + y.g * d[s];
            p.b = x.b * c[s] + y.b * d[s];
        }

        let mut dir = Rgba::new(y.r - x.r, y.g - x.g, y.b - x.b, 0.0);
        let len = dir.r * dir.r + dir.g * dir.g + dir.b * dir.b;
        if len < 1.0 / 4096.0 {
            break;
        }
        let scale = f_steps / len;
        dir = dir * scale;

        let mut d2x = 0.0f32;
        let mut d2y = 0.0f32;
        let mut dx = Rgba::ZERO;
        let mut dy = Rgba::ZERO;

        for &i in indices {
            let p = points[i];
            let dot = (p.r - x.r) * dir.r + (p.g - x.g) * dir.g + (p.b - x.b) * dir.b;

            let step = if dot <= 0.0 {
                0
            } else if dot >= f_steps {
                steps - 1
            } else {
                (dot + 0.5) as usize
            };

            let diff = Rgba::new(
                palette[step].r - p.r,
                palette[step].g - p.g,
                palette[step].b - p.b,
                0.0,
            );

            let fc = c[step] * (1.0 / 8.0);
            let fd = d[step] * (1.0 / 8.0);

            d2x += fc * c[step];
            dx.r += fc * diff.r;
            dx.g += fc * diff.g;
            dx.b += fc * diff.b;

            d2y += fd * d[step];
            dy.r += fd * diff.r;
            dy.g += fd * diff.g;
            dy.b += fd * diff.b;
        }

        if d2x > 0.0 {
            let f = -1.0 / d2x;
            x.r += dx.r * f;
            x.g += dx.g * f;
            x.b += dx.b * f;
        }
        if d2y > 0.0 {
            let f = -1.0 / d2y;
            y.r += dy.r * f;
            y.g += dy.g * f;
            y.b += dy.b * f;
        }

        if dx.r * dx.r < EPSILON
            && dx.g * dx.g < EPSILON
            && dx.b * dx.b < EPSILON
            && dy.r * dy.r < EPSILON
            && dy.g * dy.g < EPSILON
            && dy.b * dy.b < EPSILON
        {
            break;
        }
    }

    (x, y)
}

fn choose_diagonal_rgb(
    points: &[Rgba],
    indices: &[usize],
    x: &mut Rgba,
    y: &mut Rgba,
    ab: Rgba,
    f_ab: f32,
) {
    // Project every sample onto each of the four axis-flip diagonals
    // and keep the one with the largest spread.
    let inv = 1.0 / f_ab;
    let dir = Rgba::new(ab.r * inv, ab.g * inv, ab.b * inv, 0.0);
    let mid = Rgba::new(
        (x.r + y.r) * 0.5,
        (x.g + y.g) * 0.5,
        (x.b + y.b) * 0.5,
        0.0,
    );

    let mut f_dir = [0.0f32; 4];
    for &i in indices {
        let p = points[i];
        let pt = Rgba::new(
            (p.r - mid.r) * dir.r,
            (p.g - mid.g) * dir.g,
            (p.b - mid.b) * dir.b,
            0.0,
        );
        let mut f = pt.r + pt.g + pt.b;
        f_dir[0] += f * f;
        f = pt.r + pt.g - pt.b;
        f_dir[1] += f * f;
        f = pt.r - pt.g + pt.b;
        f_dir[2] += f * f;
        f = pt.r - pt.g - pt.b;
        f_dir[3] += f * f;
    }

    let mut best = 0;
    for i in 1..4 {
        if f_dir[i] > f_dir[best] {
            best = i;
        }
    }
    if best & 2 != 0 {
        std::mem::swap(&mut x.g, &mut y.g);
    }
    if best & 1 != 0 {
        std::mem::swap(&mut x.b, &mut y.b);
    }
}

/// Fits RGBA endpoints to the given subset of a 16-pixel block.
///
/// The four-channel analogue of [`optimize_rgb`] with eight diagonal
/// sign combinations; used by BC7 when colour and alpha share one
/// palette.
pub fn optimize_rgba(points: &[Rgba], steps: usize, indices: &[usize]) -> (Rgba, Rgba) {
    let (c, d) = if steps == 3 { (&C3, &D3) } else { (&C4, &D4) };

    let mut x = Rgba::new(1.0, 1.0, 1.0, 1.0);
    let mut y = Rgba::new(0.0, 0.0, 0.0, 0.0);
    for &i in indices {
        let p = points[i];
        if p.r < x.r { x.r = p.r; }
        if p.g < x.g { x.g = p.g; }
        if p.b < x.b { x.b = p.b; }
        if p.a < x.a { x.a = p.a; }
        if p.r > y.r { y.r = p.r; }
        if p.g > y.g { y.g = p.g; }
        if p.b > y.b { y.b = p.b; }
        if p.a > y.a { y.a = p.a; }
    }

    let ab = y - x;
    let f_ab = ab.dot(ab);

    if f_ab < f32::MIN_POSITIVE {
        return (x, y);
    }

    let inv = 1.0 / f_ab;
    let dir = ab * inv;
    let mid = (x + y) * 0.5;

    let mut f_dir = [0.0f32; 8];
    for &i in indices {
        let p = points[i];
        let pt = Rgba::new(
            (p.r - mid.r) * dir.r,
            (p.g - mid.g) * dir.g,
            (p.b - mid.b) * dir.b,
            (p.a - mid.a) * dir.a,
        );
        let mut f = pt.r + pt.g + pt.b + pt.a;
        f_dir[0] += f * f;
        f = pt.r + pt.g + pt.b - pt.a;
        f_dir[1] += f * f;
        f = pt.r + pt.g - pt.b + pt.a;
        f_dir[2] += f * f;
        f = pt.r + pt.g - pt.b - pt.a;
        f_dir[3] += f * f;
        f = pt.r - pt.g + pt.b + pt.a;
        f_dir[4] += f * f;
        f = pt.r - pt.g + pt.b - pt.a;
        f_dir[5] += f * f;
        f = pt.r - pt.g - pt.b + pt.a;
        f_dir[6] += f * f;
        f = pt.r - pt.g - pt.b - pt.a;
        f_dir[7] += f * f;
    }

    let mut best = 0;
    for i in 1..8 {
        if f_dir[i] > f_dir[best] {
            best = i;
        }
    }
    if best & 4 != 0 {
        std::mem::swap(&mut x.g, &mut y.g);
    }
    if best & 2 != 0 {
        std::mem::swap(&mut x.b, &mut y.b);
    }
    if best & 1 != 0 {
        std::mem::swap(&mut x.a, &mut y.a);
    }

    if f_ab < 1.0 / 4096.0 {
        return (x, y);
    }

    let f_steps = (steps - 1) as f32;
    for _ in 0..8 {
        let mut palette = [Rgba::ZERO; 4];
        for (s, p) in palette.iter_mut().enumerate().take(steps) {
            *p = x * c[s] + y * d[s];
        }

        let dir = y - x;
        let len = dir.dot(dir);
        if len < 1.0 / 4096.0 {
            break;
        }
        let dir = dir * (f_steps / len);

        let mut d2x = 0.0f32;
        let mut d2y = 0.0f32;
        let mut dx = Rgba::ZERO;
        let mut dy = Rgba::ZERO;

        for &i in indices {
            let p = points[i];
            let dot = (p - x).dot(dir);
            let step = if dot <= 0.0 {
                0
            } else if dot >= f_steps {
                steps - 1
            } else {
                (dot + 0.5) as usize
            };

            let diff = palette[step] - p;
            let fc = c[step] * (1.0 / 8.0);
            let fd = d[step] * (1.0 / 8.0);

            d2x += fc * c[step];
            dx += diff * fc;
            d2y += fd * d[step];
            dy += diff * fd;
        }

        if d2x > 0.0 {
            x += dx * (-1.0 / d2x);
        }
        if d2y > 0.0 {
            y += dy * (-1.0 / d2y);
        }

        if dx.dot(dx) < EPSILON && dy.dot(dy) < EPSILON {
            break;
        }
    }

    (x, y)
}

/// Fits scalar endpoints to a 16-sample alpha (or single-channel)
/// block.
///
/// `steps` is 8 for the full linear ramp or 6 when the two boundary
/// palette entries are pinned to the range limits. `signed` selects the
/// `[-1, 1]` range used by the SNORM formats. Returns `(x, y)` with
/// `x <= y`, clamped to the range.
pub fn optimize_alpha(points: &[f32; BLOCK_PIXELS], steps: usize, signed: bool) -> (f32, f32) {
    let (c, d) = if steps == 6 { (&C6, &D6) } else { (&C8, &D8) };
    let max_value = 1.0f32;
    let min_value = if signed { -1.0f32 } else { 0.0f32 };

    // Find min and max as the starting point. The 6-step search skips
    // samples already sitting on the pinned boundary entries.
    let mut x = max_value;
    let mut y = min_value;
    if steps == 8 {
        for &p in points {
            if p < x {
                x = p;
            }
            if p > y {
                y = p;
            }
        }
    } else {
        for &p in points {
            if p < x && p > min_value {
                x = p;
            }
            if p > y && p < max_value {
                y = p;
            }
        }
        if x == y {
            y = max_value;
        }
    }

    let f_steps = (steps - 1) as f32;

    for _ in 0..8 {
        if (y - x) < (1.0 / 256.0) {
            break;
        }

        let scale = f_steps / (y - x);

        let mut palette = [0.0f32; 8];
        for s in 0..steps {
            palette[s] = c[s] * x + d[s] * y;
        }
        if steps == 6 {
            palette[6] = min_value;
            palette[7] = max_value;
        }

        let mut dx = 0.0f32;
        let mut dy = 0.0f32;
        let mut d2x = 0.0f32;
        let mut d2y = 0.0f32;

        for &p in points {
            let dot = (p - x) * scale;

            let step = if dot <= 0.0 {
                if steps == 6 && p <= x * 0.5 {
                    6
                } else {
                    0
                }
            } else if dot >= f_steps {
                if steps == 6 && p >= (y + 1.0) * 0.5 {
                    7
                } else {
                    steps - 1
                }
            } else {
                (dot + 0.5) as usize
            };

            if step < steps {
                let diff = palette[step] - p;
                dx += c[step] * diff;
                d2x += c[step] * c[step];
                dy += d[step] * diff;
                d2y += d[step] * d[step];
            }
        }

        if d2x > 0.0 {
            x -= dx / d2x;
        }
        if d2y > 0.0 {
            y -= dy / d2y;
        }
        if x > y {
            std::mem::swap(&mut x, &mut y);
        }

        if dx * dx < (1.0 / 64.0) && dy * dy < (1.0 / 64.0) {
            break;
        }
    }

    (x.clamp(min_value, max_value), y.clamp(min_value, max_value))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [usize; 16] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15];

    #[test]
    fn test_rgb_single_colour() {
        let block = [Rgba::new(0.25, 0.5, 0.75, 1.0); 16];
        let (x, y) = optimize_rgb(&block, 4, &ALL);
        assert_eq!(x, Rgba::new(0.25, 0.5, 0.75, 0.0));
        assert_eq!(y, Rgba::new(0.25, 0.5, 0.75, 0.0));
    }

    #[test]
    fn test_rgb_two_colour_spans_inputs() {
        let mut block = [Rgba::new(0.1, 0.1, 0.1, 1.0); 16];
        for p in block.iter_mut().skip(8) {
            *p = Rgba::new(0.9, 0.9, 0.9, 1.0);
        }
        let (x, y) = optimize_rgb(&block, 4, &ALL);
        // Both endpoints stay close to the two input clusters.
        assert!((x.r - 0.1).abs() < 0.05, "x.r = {}", x.r);
        assert!((y.r - 0.9).abs() < 0.05, "y.r = {}", y.r);
    }

    #[test]
    fn test_rgba_single_colour() {
        let block = [Rgba::new(0.2, 0.4, 0.6, 0.8); 16];
        let (x, y) = optimize_rgba(&block, 4, &ALL);
        assert_eq!(x, block[0]);
        assert_eq!(y, block[0]);
    }

    #[test]
    fn test_alpha_ramp_endpoints() {
        let mut points = [0.0f32; 16];
        for (i, p) in points.iter_mut().enumerate() {
            *p = 0.2 + 0.6 * (i as f32) / 15.0;
        }
        let (x, y) = optimize_alpha(&points, 8, false);
        assert!(x <= y);
        assert!((x - 0.2).abs() < 0.05, "x = {x}");
        assert!((y - 0.8).abs() < 0.05, "y = {y}");
    }

    #[test]
    fn test_alpha_six_step_skips_boundaries() {
        let mut points = [0.5f32; 16];
        points[0] = 0.0;
        points[1] = 1.0;
        let (x, y) = optimize_alpha(&points, 6, false);
        // The pinned entries absorb 0 and 1; the fitted range hugs the
        // interior samples.
        assert!(x >= 0.0 && y <= 1.0);
        assert!(x <= 0.5 && y >= 0.5);
    }

    #[test]
    fn test_alpha_signed_range() {
        let mut points = [-0.75f32; 16];
        for p in points.iter_mut().skip(8) {
            *p = 0.75;
        }
        let (x, y) = optimize_alpha(&points, 8, true);
        assert!(x >= -1.0 && y <= 1.0);
        assert!(x < 0.0 && y > 0.0);
    }
}
