// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Separable Gaussian blur over premultiplied RGBA8 pixels.
//!
//! Weights are quantized to Q16 fixed point and normalized to exactly
//! `1 << 16`, so a blurred constant field stays constant and repeated
//! passes cannot drift brighter or darker. Edges clamp to the nearest
//! pixel. The effect radius maps to a sigma of `radius / 3`, which keeps
//! small radii visually stable.

/// Sigma for a device-pixel blur radius.
pub(crate) fn sigma_for(radius: f32) -> f32 {
    (radius / 3.0).max(0.1)
}

/// Blurs `data` (premultiplied RGBA8, row-major) in place.
///
/// A non-positive radius leaves the pixels untouched.
#[expect(
    clippy::cast_possible_truncation,
    reason = "radius is non-negative and ceiled before the cast"
)]
pub(crate) fn blur_premul_rgba8(data: &mut [u8], width: u32, height: u32, radius: f32) {
    debug_assert_eq!(data.len(), (width as usize) * (height as usize) * 4);
    if radius <= 0.0 || width == 0 || height == 0 {
        return;
    }
    let kernel = kernel_q16(radius.ceil() as u32, sigma_for(radius));
    if kernel.len() == 1 {
        return;
    }
    let mut scratch = vec![0_u8; data.len()];
    horizontal_pass(data, &mut scratch, width, height, &kernel);
    vertical_pass(&scratch, data, width, height, &kernel);
}

/// Builds the `2 * radius + 1` Q16 kernel for `sigma`.
#[expect(
    clippy::cast_possible_truncation,
    reason = "quantized weights are clamped to [0, 65536] before narrowing"
)]
fn kernel_q16(radius: u32, sigma: f32) -> Vec<u32> {
    if radius == 0 {
        return vec![1 << 16];
    }
    let r = radius as i32;
    let sigma = f64::from(sigma);
    let denom = 2.0 * sigma * sigma;

    let mut raw = Vec::with_capacity(2 * radius as usize + 1);
    let mut sum = 0.0_f64;
    for i in -r..=r {
        let x = f64::from(i);
        let weight = (-x * x / denom).exp();
        raw.push(weight);
        sum += weight;
    }

    let mut fixed: Vec<u32> = Vec::with_capacity(raw.len());
    let mut total: i64 = 0;
    for weight in &raw {
        let q = ((weight / sum) * 65536.0).round() as i64;
        let q = q.clamp(0, 65536);
        fixed.push(q as u32);
        total += q;
    }

    // Quantization drift lands on the center tap so the kernel sums to
    // exactly one.
    let drift = 65536 - total;
    if drift != 0 {
        let mid = fixed.len() / 2;
        let centered = (i64::from(fixed[mid]) + drift).clamp(0, 65536);
        fixed[mid] = centered as u32;
    }
    fixed
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "pixel coordinates fit i32 for any allocatable pixmap"
)]
fn horizontal_pass(src: &[u8], dst: &mut [u8], width: u32, height: u32, kernel: &[u32]) {
    let reach = (kernel.len() / 2) as i32;
    let w = width as i32;
    for y in 0..height as i32 {
        for x in 0..w {
            let mut acc = [0_u64; 4];
            for (tap, &weight) in kernel.iter().enumerate() {
                let sx = (x + tap as i32 - reach).clamp(0, w - 1);
                let idx = ((y * w + sx) as usize) * 4;
                for channel in 0..4 {
                    acc[channel] += u64::from(weight) * u64::from(src[idx + channel]);
                }
            }
            let out = ((y * w + x) as usize) * 4;
            for channel in 0..4 {
                dst[out + channel] = quantize(acc[channel]);
            }
        }
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "pixel coordinates fit i32 for any allocatable pixmap"
)]
fn vertical_pass(src: &[u8], dst: &mut [u8], width: u32, height: u32, kernel: &[u32]) {
    let reach = (kernel.len() / 2) as i32;
    let w = width as i32;
    let h = height as i32;
    for y in 0..h {
        for x in 0..w {
            let mut acc = [0_u64; 4];
            for (tap, &weight) in kernel.iter().enumerate() {
                let sy = (y + tap as i32 - reach).clamp(0, h - 1);
                let idx = ((sy * w + x) as usize) * 4;
                for channel in 0..4 {
                    acc[channel] += u64::from(weight) * u64::from(src[idx + channel]);
                }
            }
            let out = ((y * w + x) as usize) * 4;
            for channel in 0..4 {
                dst[out + channel] = quantize(acc[channel]);
            }
        }
    }
}

/// Rounds a Q16 accumulator back to an 8-bit channel.
#[expect(
    clippy::cast_possible_truncation,
    reason = "value is clamped to 255 before narrowing"
)]
fn quantize(acc: u64) -> u8 {
    ((acc + (1 << 15)) >> 16).min(255) as u8
}
