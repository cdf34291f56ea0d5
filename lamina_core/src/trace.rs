// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for tree construction.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that
//! the relationship resolver calls while building a layer tree. All method
//! bodies default to no-ops, so implementing only the events you care about
//! is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace`
//! feature is **off**, every `Tracer` method compiles to nothing (zero
//! overhead). When **on**, each method performs a single `Option` branch
//! before dispatching.
//!
//! Construction is the only phase that reports through this module; draw
//! diagnostics are a surface concern (a recording [`Surface`] decorator
//! lives in the debug crate).
//!
//! # Crate features
//!
//! - `trace` — enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`) — gates the per-layer
//!   [`LayerBuiltEvent`] and its `TraceSink` method.
//!
//! [`Surface`]: crate::surface::Surface

use crate::model::LayerId;

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Why a layer model produced no runtime layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// The model's kind is not understood by this build.
    UnsupportedKind,
    /// A precomp layer referenced an asset id the document does not define.
    MissingPrecompAsset,
}

/// Emitted for every constructed layer (requires `trace-rich`).
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug)]
pub struct LayerBuiltEvent {
    /// Index of the source model in its layer list.
    pub model_index: usize,
    /// The layer's identity.
    pub id: LayerId,
    /// False when the layer was consumed as a matte source instead of
    /// joining the paintable list.
    pub paintable: bool,
}

/// Emitted when a model is skipped during construction.
#[derive(Clone, Copy, Debug)]
pub struct LayerSkippedEvent {
    /// Index of the skipped model in its layer list.
    pub model_index: usize,
    /// The skipped model's identity.
    pub id: LayerId,
    /// Why it was skipped.
    pub reason: SkipReason,
}

/// Emitted when a matte pairing is established.
#[derive(Clone, Copy, Debug)]
pub struct MatteAttachedEvent {
    /// The layer that declared the matte and consumes the source.
    pub consumer: LayerId,
    /// The layer consumed as the matte source.
    pub source: LayerId,
}

/// Emitted when a declared parent id resolves to nothing.
#[derive(Clone, Copy, Debug)]
pub struct ParentMissingEvent {
    /// The layer whose parent is missing.
    pub child: LayerId,
    /// The dangling parent id.
    pub parent: LayerId,
}

/// Per-list construction summary.
#[derive(Clone, Copy, Debug, Default)]
pub struct ResolveSummary {
    /// Models in the input list.
    pub models: usize,
    /// Layers in the paintable list.
    pub paintable: usize,
    /// Layers consumed as matte sources.
    pub matted: usize,
    /// Models skipped entirely.
    pub skipped: usize,
    /// Parent references that did not resolve.
    pub missing_parents: usize,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from tree construction.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called for every constructed layer (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    fn on_layer_built(&mut self, e: &LayerBuiltEvent) {
        _ = e;
    }

    /// Called when a model is skipped.
    fn on_layer_skipped(&mut self, e: &LayerSkippedEvent) {
        _ = e;
    }

    /// Called when a matte pairing is established.
    fn on_matte_attached(&mut self, e: &MatteAttachedEvent) {
        _ = e;
    }

    /// Called when a parent id fails to resolve.
    fn on_parent_missing(&mut self, e: &ParentMissingEvent) {
        _ = e;
    }

    /// Called once per constructed layer list with totals.
    fn on_resolve_summary(&mut self, s: &ResolveSummary) {
        _ = s;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing.
/// When **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`LayerBuiltEvent`] (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn layer_built(&mut self, e: &LayerBuiltEvent) {
        if let Some(s) = &mut self.sink {
            s.on_layer_built(e);
        }
    }

    /// Emits a [`LayerSkippedEvent`].
    #[inline]
    pub fn layer_skipped(&mut self, e: &LayerSkippedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_layer_skipped(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`MatteAttachedEvent`].
    #[inline]
    pub fn matte_attached(&mut self, e: &MatteAttachedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_matte_attached(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`ParentMissingEvent`].
    #[inline]
    pub fn parent_missing(&mut self, e: &ParentMissingEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_parent_missing(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`ResolveSummary`].
    #[inline]
    pub fn resolve_summary(&mut self, s: &ResolveSummary) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.on_resolve_summary(s);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = s;
        }
    }
}
