// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Software rasterization backend for lamina.
//!
//! [`RasterSurface`](surface::RasterSurface) implements
//! [`lamina_core::surface::Surface`] over a [`tiny_skia::Pixmap`]: rect
//! fills and registered content blits land on the pixmap, clips become
//! coverage masks, and offscreen passes render into scratch pixmaps that
//! are blurred, shadowed, and composited back when they end.
//!
//! The pixel work that is not plain painting, the fixed-point separable
//! Gaussian used for blur and shadow softness, lives in a private module
//! and is reached only through compose ops.

pub mod surface;

mod blur;
