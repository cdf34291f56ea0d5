// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Draw-op stream capture.
//!
//! [`RecordingSurface`] implements [`Surface`] and appends every op to a
//! [`SurfaceOp`] list, optionally forwarding each call to an inner surface.
//! Recorded streams feed [`json::export`](crate::json::export) or direct
//! assertions in tests.

use std::fmt;

use kurbo::{Affine, Rect};

use lamina_core::model::{Color, ContentId};
use lamina_core::surface::{ComposeOp, Surface};

/// One recorded surface op, parameters included.
#[derive(Clone, Debug, PartialEq)]
pub enum SurfaceOp {
    /// A clip-state push.
    Save,
    /// A clip-state pop.
    Restore,
    /// A clip intersection; `visible` is what the surface answered.
    ClipRect {
        /// The device-space clip rectangle.
        rect: Rect,
        /// Whether drawing continued under this clip.
        visible: bool,
    },
    /// A solid fill.
    FillRect {
        /// The layer-local rectangle.
        rect: Rect,
        /// Mapping into device space.
        transform: Affine,
        /// Fill color.
        color: Color,
        /// Applied alpha, 255 = opaque.
        alpha: u8,
    },
    /// An externally registered content draw.
    DrawContent {
        /// The content handle.
        content: ContentId,
        /// The content's layer-local extent.
        bounds: Rect,
        /// Mapping into device space.
        transform: Affine,
        /// Applied alpha, 255 = opaque.
        alpha: u8,
    },
    /// An offscreen pass start.
    BeginLayer {
        /// The pass's device-space rectangle.
        bounds: Rect,
        /// Composite parameters for the matching end.
        op: ComposeOp,
    },
    /// An offscreen pass end.
    EndLayer,
}

/// A [`Surface`] that draws nothing and reports every clip as visible.
///
/// The default inner surface of a standalone [`RecordingSurface`].
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSurface;

impl Surface for NullSurface {
    fn save(&mut self) {}
    fn restore(&mut self) {}
    fn clip_rect(&mut self, _rect: Rect) -> bool {
        true
    }
    fn fill_rect(&mut self, _rect: Rect, _transform: Affine, _color: Color, _alpha: u8) {}
    fn draw_content(&mut self, _content: ContentId, _bounds: Rect, _transform: Affine, _alpha: u8) {
    }
    fn begin_layer(&mut self, _bounds: Rect, _op: &ComposeOp) {}
    fn end_layer(&mut self) {}
}

/// Captures the op stream of a frame.
///
/// Standalone recorders answer `true` to every clip so the full tree gets
/// drawn (and recorded). A forwarding recorder defers to the inner surface
/// instead, so the stream matches what actually rendered.
pub struct RecordingSurface<S = NullSurface> {
    ops: Vec<SurfaceOp>,
    inner: Option<S>,
}

impl RecordingSurface {
    /// Creates a standalone recorder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ops: Vec::new(),
            inner: None,
        }
    }
}

impl Default for RecordingSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Surface> RecordingSurface<S> {
    /// Creates a recorder that forwards every op to `inner`.
    #[must_use]
    pub fn over(inner: S) -> Self {
        Self {
            ops: Vec::new(),
            inner: Some(inner),
        }
    }

    /// The recorded ops, in call order.
    #[must_use]
    pub fn ops(&self) -> &[SurfaceOp] {
        &self.ops
    }

    /// Consumes the recorder, returning the recorded ops.
    #[must_use]
    pub fn into_ops(self) -> Vec<SurfaceOp> {
        self.ops
    }

    /// Consumes the recorder, returning the inner surface if any.
    #[must_use]
    pub fn into_inner(self) -> Option<S> {
        self.inner
    }
}

impl<S> fmt::Debug for RecordingSurface<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingSurface")
            .field("ops", &self.ops.len())
            .field("forwarding", &self.inner.is_some())
            .finish_non_exhaustive()
    }
}

impl<S: Surface> Surface for RecordingSurface<S> {
    fn save(&mut self) {
        self.ops.push(SurfaceOp::Save);
        if let Some(inner) = &mut self.inner {
            inner.save();
        }
    }

    fn restore(&mut self) {
        self.ops.push(SurfaceOp::Restore);
        if let Some(inner) = &mut self.inner {
            inner.restore();
        }
    }

    fn clip_rect(&mut self, rect: Rect) -> bool {
        let visible = match &mut self.inner {
            Some(inner) => inner.clip_rect(rect),
            None => true,
        };
        self.ops.push(SurfaceOp::ClipRect { rect, visible });
        visible
    }

    fn fill_rect(&mut self, rect: Rect, transform: Affine, color: Color, alpha: u8) {
        self.ops.push(SurfaceOp::FillRect {
            rect,
            transform,
            color,
            alpha,
        });
        if let Some(inner) = &mut self.inner {
            inner.fill_rect(rect, transform, color, alpha);
        }
    }

    fn draw_content(&mut self, content: ContentId, bounds: Rect, transform: Affine, alpha: u8) {
        self.ops.push(SurfaceOp::DrawContent {
            content,
            bounds,
            transform,
            alpha,
        });
        if let Some(inner) = &mut self.inner {
            inner.draw_content(content, bounds, transform, alpha);
        }
    }

    fn begin_layer(&mut self, bounds: Rect, op: &ComposeOp) {
        self.ops.push(SurfaceOp::BeginLayer {
            bounds,
            op: op.clone(),
        });
        if let Some(inner) = &mut self.inner {
            inner.begin_layer(bounds, op);
        }
    }

    fn end_layer(&mut self) {
        self.ops.push(SurfaceOp::EndLayer);
        if let Some(inner) = &mut self.inner {
            inner.end_layer();
        }
    }
}
