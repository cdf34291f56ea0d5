// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per
//! construction event to a [`Write`](std::io::Write) destination (default:
//! stderr).

use std::io::Write;

use lamina_core::trace::{
    LayerBuiltEvent, LayerSkippedEvent, MatteAttachedEvent, ParentMissingEvent, ResolveSummary,
    SkipReason, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }
}

fn reason_name(reason: SkipReason) -> &'static str {
    match reason {
        SkipReason::UnsupportedKind => "unsupported-kind",
        SkipReason::MissingPrecompAsset => "missing-precomp-asset",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_layer_built(&mut self, e: &LayerBuiltEvent) {
        let _ = writeln!(
            self.writer,
            "[built] model={} id={} paintable={}",
            e.model_index, e.id.0, e.paintable,
        );
    }

    fn on_layer_skipped(&mut self, e: &LayerSkippedEvent) {
        let _ = writeln!(
            self.writer,
            "[skip] model={} id={} reason={}",
            e.model_index,
            e.id.0,
            reason_name(e.reason),
        );
    }

    fn on_matte_attached(&mut self, e: &MatteAttachedEvent) {
        let _ = writeln!(
            self.writer,
            "[matte] consumer={} source={}",
            e.consumer.0, e.source.0,
        );
    }

    fn on_parent_missing(&mut self, e: &ParentMissingEvent) {
        let _ = writeln!(
            self.writer,
            "[parent-missing] child={} parent={}",
            e.child.0, e.parent.0,
        );
    }

    fn on_resolve_summary(&mut self, s: &ResolveSummary) {
        let _ = writeln!(
            self.writer,
            "[summary] models={} paintable={} matted={} skipped={} missing-parents={}",
            s.models, s.paintable, s.matted, s.skipped, s.missing_parents,
        );
    }
}
