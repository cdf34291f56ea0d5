// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Target-surface contract for rendering backends.
//!
//! The compositor draws through the [`Surface`] trait and nothing else; a
//! backend crate (software rasterizer, GPU recorder, test double) implements
//! it. The op set is deliberately small:
//!
//! - **State scoping** — [`save`](Surface::save) / [`restore`](Surface::restore)
//!   bracket clip changes with strict stack discipline.
//! - **Clipping** — [`clip_rect`](Surface::clip_rect) intersects the current
//!   clip with a device-space rectangle and reports whether anything is left
//!   to draw. Mapping rectangles *into* device space is kurbo's
//!   [`Affine::transform_rect_bbox`](kurbo::Affine::transform_rect_bbox),
//!   not a surface op.
//! - **Leaf content** — [`fill_rect`](Surface::fill_rect) for solids and
//!   [`draw_content`](Surface::draw_content) for externally registered
//!   content.
//! - **Offscreen passes** — [`begin_layer`](Surface::begin_layer) redirects
//!   subsequent ops into an intermediate buffer scoped to a rectangle;
//!   [`end_layer`](Surface::end_layer) composites that buffer back applying
//!   the pass's [`ComposeOp`] (alpha, blend mode, blur, shadow) as one
//!   blended operation. Passes nest; each `begin` pairs with exactly one
//!   `end`, innermost first.
//!
//! # Draw protocol
//!
//! One frame of a composition layer drives a surface like this:
//!
//! ```rust,ignore
//! surface.save();
//! if surface.clip_rect(mapped_bounds) {
//!     surface.begin_layer(mapped_bounds, &op); // only when flattening
//!     for child in paint_order {
//!         child.draw(surface, transform, alpha, shadow, blur);
//!     }
//!     surface.end_layer();
//! }
//! surface.restore();
//! ```

use kurbo::{Affine, Rect};

use crate::effects::DropShadow;
use crate::model::{Color, ContentId};

/// How an offscreen pass blends into its parent at composite time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    /// Ordinary source-over alpha blending.
    #[default]
    SrcOver,
    /// Keeps destination pixels where the source is opaque (matte "add").
    DestIn,
    /// Keeps destination pixels where the source is transparent (matte
    /// "invert").
    DestOut,
}

/// Parameters applied when an offscreen pass composites back.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct ComposeOp {
    /// Uniform alpha applied to the flattened buffer; 255 = opaque.
    pub alpha: u8,
    /// Blend mode for the composite.
    pub blend: BlendMode,
    /// Shadow drawn from the buffer's alpha before the buffer itself.
    pub shadow: Option<DropShadow>,
    /// Gaussian blur radius in device pixels applied to the buffer.
    pub blur: f32,
}

impl ComposeOp {
    /// A plain composite: opaque, source-over, no effects.
    #[must_use]
    pub fn opaque() -> Self {
        Self {
            alpha: 255,
            blend: BlendMode::SrcOver,
            shadow: None,
            blur: 0.0,
        }
    }

    /// A source-over composite at the given alpha.
    #[must_use]
    pub fn with_alpha(alpha: u8) -> Self {
        Self {
            alpha,
            ..Self::opaque()
        }
    }

    /// A composite with the given blend mode at full alpha.
    #[must_use]
    pub fn with_blend(blend: BlendMode) -> Self {
        Self {
            blend,
            ..Self::opaque()
        }
    }
}

/// A 2-D render target the compositor draws into.
///
/// Coordinates handed to the surface are always device-space: the compositor
/// flattens its transform stack into the `Affine` passed alongside each
/// geometry op, so implementations never track a transform of their own.
pub trait Surface {
    /// Pushes the current clip state.
    fn save(&mut self);

    /// Pops to the most recent [`save`](Self::save).
    ///
    /// Calls must pair with `save`; implementations may panic on underflow.
    fn restore(&mut self);

    /// Intersects the current clip with a device-space rectangle.
    ///
    /// Returns `false` when the resulting clip is empty, in which case the
    /// caller skips drawing until the scope is restored.
    fn clip_rect(&mut self, rect: Rect) -> bool;

    /// Fills `rect`, mapped through `transform`, with `color` at `alpha`.
    fn fill_rect(&mut self, rect: Rect, transform: Affine, color: Color, alpha: u8);

    /// Draws externally registered content. `bounds` is the content's
    /// layer-local extent, mapped through `transform`.
    fn draw_content(&mut self, content: ContentId, bounds: Rect, transform: Affine, alpha: u8);

    /// Starts an offscreen pass scoped to a device-space rectangle.
    ///
    /// Until the matching [`end_layer`](Self::end_layer), every op lands in
    /// the pass's buffer instead of the current target.
    fn begin_layer(&mut self, bounds: Rect, op: &ComposeOp);

    /// Ends the innermost offscreen pass and composites its buffer onto the
    /// surrounding target using the `ComposeOp` it was started with.
    ///
    /// Calls must pair with [`begin_layer`](Self::begin_layer);
    /// implementations may panic on underflow.
    fn end_layer(&mut self);
}
