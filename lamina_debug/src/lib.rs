// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording, pretty-printing, and JSON export for lamina diagnostics.
//!
//! This crate provides development and post-mortem tooling around the core's
//! two observation seams:
//!
//! - [`pretty::PrettyPrintSink`] — a
//!   [`TraceSink`](lamina_core::trace::TraceSink) with human-readable
//!   one-line-per-event output for tree construction.
//! - [`record::RecordingSurface`] — a
//!   [`Surface`](lamina_core::surface::Surface) decorator that captures the
//!   draw-op stream of a frame, optionally forwarding to a real surface.
//! - [`json::export`] — writes a recorded op stream as JSON for diffing and
//!   external tooling.

pub mod json;
pub mod pretty;
pub mod record;
