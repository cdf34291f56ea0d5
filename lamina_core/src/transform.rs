// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Animatable layer transform.
//!
//! [`AnimatedTransform`] carries the per-channel tracks an authoring tool
//! exports for a layer (anchor, position, scale, rotation) and lowers a
//! sample of all of them to a single kurbo [`Affine`]. Composition order
//! matches After Effects: translate, rotate, scale, then shift by the
//! negated anchor.

use kurbo::{Affine, Vec2};

use crate::animated::Animated;

/// Per-channel animated 2-D transform.
#[derive(Clone, Debug, PartialEq)]
pub struct AnimatedTransform {
    /// Anchor point in layer-local pixels. Static; anchor animation is not
    /// modeled.
    pub anchor: Vec2,
    /// Translation track, document pixels.
    pub position: Animated<Vec2>,
    /// Scale track; `(1, 1)` is unscaled.
    pub scale: Animated<Vec2>,
    /// Rotation track in degrees, turning from +x toward +y.
    pub rotation: Animated<f32>,
}

impl AnimatedTransform {
    /// The do-nothing transform.
    #[must_use]
    pub fn identity() -> Self {
        Self {
            anchor: Vec2::ZERO,
            position: Animated::constant(Vec2::ZERO),
            scale: Animated::constant(Vec2::new(1.0, 1.0)),
            rotation: Animated::constant(0.0),
        }
    }

    /// Samples every channel at `progress` and composes the affine.
    #[must_use]
    pub fn sample(&self, progress: f32) -> Affine {
        let position = self.position.sample(progress);
        let scale = self.scale.sample(progress);
        let rotation = f64::from(self.rotation.sample(progress)).to_radians();
        Affine::translate(position)
            * Affine::rotate(rotation)
            * Affine::scale_non_uniform(scale.x, scale.y)
            * Affine::translate(-self.anchor)
    }
}

impl Default for AnimatedTransform {
    #[inline]
    fn default() -> Self {
        Self::identity()
    }
}
