// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hierarchical animation-layer compositing core.
//!
//! `lamina_core` owns the runtime layer tree for one vector-animation
//! document: it resolves parent and matte relationships between siblings,
//! advances every layer in lock-step to a shared animation progress (with
//! optional nonlinear time remapping), and renders the tree back-to-front
//! into an abstract target surface, engaging an offscreen compositing pass
//! only when alpha, blur, or shadow flattening requires one. It is `no_std`
//! compatible (with `alloc`).
//!
//! # Architecture
//!
//! A document flows through three phases, construction once and the other
//! two once per frame:
//!
//! ```text
//!   Document ──► Layer::from_document() ──► layer tree (arena + paint order)
//!                                               │
//!   progress ──► Layer::set_progress() ──► remap / offset / stretch ──► children
//!                                               │
//!   Layer::draw() ──► clip + offscreen decision ──► Surface ops ──► target
//! ```
//!
//! **[`model`]** — The immutable document model: [`Document`](model::Document),
//! [`LayerModel`](model::LayerModel), layer kinds, matte modes, and effect
//! definitions. Built in memory; parsing an interchange format is out of
//! scope.
//!
//! **[`animated`]** — Minimal keyframe tracks ([`Animated`](animated::Animated))
//! consumed as opaque `sample(progress) → value` providers.
//!
//! **[`transform`]** — Animatable anchor/position/scale/rotation transform
//! that lowers to a kurbo [`Affine`](kurbo::Affine).
//!
//! **[`layer`]** — The runtime tree: the per-layer chassis, the closed set of
//! layer variants, the construction-time relationship resolver, and the
//! composition layer with the full draw/progress/bounds/key-path contracts.
//!
//! **[`effects`]** — Pure pull evaluators for drop shadow and blur, each with
//! dynamic override slots, producing device-space descriptors.
//!
//! **[`surface`]** — The [`Surface`](surface::Surface) capability the
//! compositor draws through, including scoped offscreen passes.
//!
//! **[`keypath`]** — Name-path patterns (`*`, `**`) for targeting nested
//! layers from outside.
//!
//! **[`trace`]** — [`TraceSink`](trace::TraceSink) trait and event types for
//! construction and frame diagnostics, with zero-overhead
//! [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one
//!   branch per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-layer
//!   construction events.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod animated;
pub mod effects;
pub mod keypath;
pub mod layer;
pub mod model;
pub mod surface;
pub mod trace;
pub mod transform;
