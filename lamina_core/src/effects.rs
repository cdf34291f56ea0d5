// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Effect evaluators.
//!
//! [`ShadowAnimation`] and [`BlurAnimation`] wrap the animated effect
//! definitions of a layer model and evaluate them on demand: pure functions
//! of (progress, transform, alpha) with no listener wiring. Each animated
//! channel carries an override slot so a dynamic value can shadow the
//! document track without destroying it; clearing the override falls back
//! to the track.
//!
//! Evaluation produces device-space descriptors: distances and radii are
//! multiplied by the transform's scale factor so backends can consume them
//! without seeing the transform.

use alloc::boxed::Box;
use core::fmt;

use kurbo::{Affine, Vec2};
#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

use crate::animated::Animated;
use crate::model::{BlurEffect, Color, DropShadowEffect};

/// A dynamic scalar provider: progress in, value out.
pub type ScalarProvider = Box<dyn Fn(f32) -> f32>;

/// A dynamic color provider: progress in, color out.
pub type ColorProvider = Box<dyn Fn(f32) -> Color>;

/// A fully evaluated drop shadow, in device space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DropShadow {
    /// Shadow tint; the alpha channel already folds the shadow opacity with
    /// the layer alpha it was evaluated against.
    pub color: Color,
    /// Offset from the layer in device pixels.
    pub offset: Vec2,
    /// Softness radius in device pixels.
    pub radius: f32,
}

/// Pull evaluator for a drop-shadow effect.
pub struct ShadowAnimation {
    color: Animated<Color>,
    opacity: Animated<f32>,
    direction: Animated<f32>,
    distance: Animated<f32>,
    radius: Animated<f32>,
    color_override: Option<ColorProvider>,
    opacity_override: Option<ScalarProvider>,
    direction_override: Option<ScalarProvider>,
    distance_override: Option<ScalarProvider>,
    radius_override: Option<ScalarProvider>,
}

impl ShadowAnimation {
    /// Creates an evaluator over a model effect definition.
    #[must_use]
    pub fn new(effect: &DropShadowEffect) -> Self {
        Self {
            color: effect.color.clone(),
            opacity: effect.opacity.clone(),
            direction: effect.direction.clone(),
            distance: effect.distance.clone(),
            radius: effect.radius.clone(),
            color_override: None,
            opacity_override: None,
            direction_override: None,
            distance_override: None,
            radius_override: None,
        }
    }

    /// Evaluates the shadow at `progress` under `transform`, folding
    /// `alpha` (the alpha the shadowed content will be drawn with) into the
    /// descriptor's color.
    #[must_use]
    pub fn evaluate(&self, progress: f32, transform: Affine, alpha: u8) -> DropShadow {
        let scale = scale_factor(transform);
        let color = match &self.color_override {
            Some(p) => p(progress),
            None => self.color.sample(progress),
        };
        let opacity = match &self.opacity_override {
            Some(p) => p(progress),
            None => self.opacity.sample(progress),
        }
        .clamp(0.0, 1.0);
        let direction = match &self.direction_override {
            Some(p) => p(progress),
            None => self.direction.sample(progress),
        };
        let distance = match &self.distance_override {
            Some(p) => p(progress),
            None => self.distance.sample(progress),
        };
        let radius = match &self.radius_override {
            Some(p) => p(progress),
            None => self.radius.sample(progress),
        };

        let theta = direction.to_radians();
        let reach = f64::from(distance * scale);
        DropShadow {
            color: color.with_alpha(scale_alpha(alpha, opacity)),
            offset: Vec2::new(reach * f64::from(theta.sin()), reach * f64::from(theta.cos())),
            radius: radius.max(0.0) * scale,
        }
    }

    /// Replaces or clears the color override.
    pub fn set_color_override(&mut self, provider: Option<ColorProvider>) {
        self.color_override = provider;
    }

    /// Replaces or clears the opacity override.
    pub fn set_opacity_override(&mut self, provider: Option<ScalarProvider>) {
        self.opacity_override = provider;
    }

    /// Replaces or clears the direction override.
    pub fn set_direction_override(&mut self, provider: Option<ScalarProvider>) {
        self.direction_override = provider;
    }

    /// Replaces or clears the distance override.
    pub fn set_distance_override(&mut self, provider: Option<ScalarProvider>) {
        self.distance_override = provider;
    }

    /// Replaces or clears the radius override.
    pub fn set_radius_override(&mut self, provider: Option<ScalarProvider>) {
        self.radius_override = provider;
    }
}

impl fmt::Debug for ShadowAnimation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShadowAnimation")
            .field("color", &self.color)
            .field("opacity", &self.opacity)
            .field("direction", &self.direction)
            .field("distance", &self.distance)
            .field("radius", &self.radius)
            .finish_non_exhaustive()
    }
}

/// Pull evaluator for a blur effect.
pub struct BlurAnimation {
    radius: Animated<f32>,
    radius_override: Option<ScalarProvider>,
}

impl BlurAnimation {
    /// Creates an evaluator over a model effect definition.
    #[must_use]
    pub fn new(effect: &BlurEffect) -> Self {
        Self {
            radius: effect.radius.clone(),
            radius_override: None,
        }
    }

    /// Evaluates the blur radius at `progress`, scaled to device pixels
    /// under `transform`. Never negative.
    #[must_use]
    pub fn evaluate(&self, progress: f32, transform: Affine) -> f32 {
        let radius = match &self.radius_override {
            Some(p) => p(progress),
            None => self.radius.sample(progress),
        };
        radius.max(0.0) * scale_factor(transform)
    }

    /// Replaces or clears the radius override.
    pub fn set_radius_override(&mut self, provider: Option<ScalarProvider>) {
        self.radius_override = provider;
    }
}

impl fmt::Debug for BlurAnimation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlurAnimation")
            .field("radius", &self.radius)
            .finish_non_exhaustive()
    }
}

/// Uniform document-to-device scale of a transform (geometric mean of the
/// axis scales).
#[expect(
    clippy::cast_possible_truncation,
    reason = "device scale factors fit f32 comfortably"
)]
fn scale_factor(transform: Affine) -> f32 {
    transform.determinant().abs().sqrt() as f32
}

/// Scales an 8-bit alpha by a normalized factor, rounding to nearest.
#[expect(
    clippy::cast_possible_truncation,
    reason = "value is clamped to the u8 range before the cast"
)]
pub(crate) fn scale_alpha(alpha: u8, factor: f32) -> u8 {
    (f32::from(alpha) * factor + 0.5).clamp(0.0, 255.0) as u8
}
