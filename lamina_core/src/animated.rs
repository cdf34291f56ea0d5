// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Minimal keyframe tracks.
//!
//! [`Animated<T>`] is the value-provider boundary of this crate: everything
//! that varies over time (transforms, opacity, effect parameters, time
//! remaps) is stored as one of these and sampled with a normalized progress
//! in `[0, 1]`. Only constant values and linear/hold keyframes are modeled;
//! easing curves belong to the authoring pipeline that produced the
//! document, not here.

use alloc::vec::Vec;

use kurbo::Vec2;

use crate::model::Color;

/// Linear interpolation between two values of a type.
pub trait Lerp {
    /// Interpolates from `self` (at `t = 0`) to `other` (at `t = 1`).
    #[must_use]
    fn lerp(&self, other: &Self, t: f32) -> Self;
}

impl Lerp for f32 {
    #[inline]
    fn lerp(&self, other: &Self, t: f32) -> Self {
        self + (other - self) * t
    }
}

impl Lerp for f64 {
    #[inline]
    fn lerp(&self, other: &Self, t: f32) -> Self {
        self + (other - self) * f64::from(t)
    }
}

impl Lerp for Vec2 {
    #[inline]
    fn lerp(&self, other: &Self, t: f32) -> Self {
        *self + (*other - *self) * f64::from(t)
    }
}

impl Lerp for Color {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        Self {
            r: lerp_channel(self.r, other.r, t),
            g: lerp_channel(self.g, other.g, t),
            b: lerp_channel(self.b, other.b, t),
            a: lerp_channel(self.a, other.a, t),
        }
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "value is clamped to the u8 range before the cast"
)]
fn lerp_channel(a: u8, b: u8, t: f32) -> u8 {
    let v = f32::from(a) + (f32::from(b) - f32::from(a)) * t;
    (v + 0.5).clamp(0.0, 255.0) as u8
}

/// One keyframe of an [`Animated`] track.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keyframe<T> {
    /// Progress at which this keyframe's value applies, in `[0, 1]`.
    pub offset: f32,
    /// The value at `offset`.
    pub value: T,
    /// If set, the value holds flat until the next keyframe instead of
    /// interpolating toward it.
    pub hold: bool,
}

impl<T> Keyframe<T> {
    /// Creates an interpolating keyframe.
    #[inline]
    pub const fn new(offset: f32, value: T) -> Self {
        Self {
            offset,
            value,
            hold: false,
        }
    }

    /// Creates a hold keyframe.
    #[inline]
    pub const fn hold(offset: f32, value: T) -> Self {
        Self {
            offset,
            value,
            hold: true,
        }
    }
}

/// A time-varying value: either a constant or a sorted keyframe track.
#[derive(Clone, Debug, PartialEq)]
pub enum Animated<T> {
    /// The same value at every progress.
    Constant(T),
    /// Keyframes in ascending `offset` order.
    Keyframes(Vec<Keyframe<T>>),
}

impl<T: Clone + Lerp> Animated<T> {
    /// Creates a constant track.
    #[inline]
    pub const fn constant(value: T) -> Self {
        Self::Constant(value)
    }

    /// Creates a keyframed track.
    ///
    /// # Panics
    ///
    /// Panics if `frames` is empty or not sorted by ascending `offset`.
    #[must_use]
    pub fn keyframes(frames: Vec<Keyframe<T>>) -> Self {
        assert!(!frames.is_empty(), "keyframe track needs at least one frame");
        assert!(
            frames.windows(2).all(|w| w[0].offset <= w[1].offset),
            "keyframes must be sorted by ascending offset"
        );
        Self::Keyframes(frames)
    }

    /// Samples the track at a normalized progress.
    ///
    /// Before the first keyframe the first value is returned; past the last,
    /// the last. Between two keyframes the value interpolates linearly
    /// unless the earlier keyframe holds.
    #[must_use]
    pub fn sample(&self, progress: f32) -> T {
        match self {
            Self::Constant(value) => value.clone(),
            Self::Keyframes(frames) => {
                let next = frames.partition_point(|k| k.offset <= progress);
                if next == 0 {
                    return frames[0].value.clone();
                }
                if next == frames.len() {
                    return frames[next - 1].value.clone();
                }
                let a = &frames[next - 1];
                let b = &frames[next];
                if a.hold {
                    return a.value.clone();
                }
                let span = b.offset - a.offset;
                if span <= 0.0 {
                    return a.value.clone();
                }
                let t = (progress - a.offset) / span;
                a.value.lerp(&b.value, t)
            }
        }
    }
}
