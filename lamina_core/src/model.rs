// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Immutable document model.
//!
//! A [`Document`] is the already-parsed description of one animation: a frame
//! range, a flat list of [`LayerModel`]s for the root composition, and named
//! layer lists for every precomposition asset referenced from it. Models are
//! plain data; the runtime tree built from them lives in
//! [`layer`](crate::layer) and never mutates the document.
//!
//! Identity is carried by [`LayerId`]. Parent references resolve among the
//! siblings of the same list only. Leaf content that this crate does not
//! rasterize itself (shapes, images, text) is referenced through an opaque
//! [`ContentId`] that the surface implementation resolves at draw time.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::animated::Animated;
use crate::transform::AnimatedTransform;

/// Display name reserved for the implicit root container layer of a document.
///
/// The container is synthesized by the embedder (see
/// [`Layer::from_document`](crate::layer::Layer::from_document)) and is the
/// only layer exempt from time-stretch division and key-path naming.
pub const CONTAINER_NAME: &str = "__container";

/// Identifies a layer within one layer list.
///
/// Ids are author-assigned and opaque to this crate; they only need to be
/// unique within the list that declares them for parent resolution to work.
/// A duplicated or dangling id degrades to a missing relation, never an
/// error.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct LayerId(pub u64);

impl fmt::Debug for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LayerId({})", self.0)
    }
}

/// Identifies externally registered leaf content (a rasterized shape, a
/// decoded image, shaped text).
///
/// Surface implementations map these to their own resources; core code
/// passes them through without interpreting the value.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ContentId(pub u32);

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({})", self.0)
    }
}

/// A straight (non-premultiplied) 8-bit RGBA color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel, 255 = opaque.
    pub a: u8,
}

impl Color {
    /// Opaque black.
    pub const BLACK: Self = Self::rgb8(0, 0, 0);
    /// Opaque white.
    pub const WHITE: Self = Self::rgb8(255, 255, 255);
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::rgba8(0, 0, 0, 0);

    /// Creates a color from four 8-bit channels.
    #[inline]
    #[must_use]
    pub const fn rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Creates an opaque color from three 8-bit channels.
    #[inline]
    #[must_use]
    pub const fn rgb8(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Returns this color with its alpha replaced.
    #[inline]
    #[must_use]
    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }
}

/// How a layer consumes the sibling above it as a track matte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum MatteMode {
    /// No matte; the layer paints normally.
    #[default]
    None,
    /// The matte's alpha reveals the layer where the matte is opaque.
    Add,
    /// The matte's alpha reveals the layer where the matte is transparent.
    Invert,
}

impl MatteMode {
    /// Whether this mode declares a matte pairing at all.
    #[inline]
    #[must_use]
    pub const fn is_matte(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Externally rasterized leaf content plus its declared pixel extent.
#[derive(Clone, Debug, PartialEq)]
pub struct ContentRef {
    /// Handle resolved by the surface implementation.
    pub id: ContentId,
    /// Declared content width in document pixels.
    pub width: f64,
    /// Declared content height in document pixels.
    pub height: f64,
}

/// What a layer is, fixed at construction.
#[derive(Clone, Debug, PartialEq)]
pub enum LayerKind {
    /// A nested precomposition; `asset` names a layer list in
    /// [`Document::precomps`].
    Precomp {
        /// Asset id of the referenced layer list.
        asset: String,
    },
    /// A solid color rectangle, rasterized entirely in-core.
    Solid {
        /// Fill color.
        color: Color,
        /// Solid width in document pixels.
        width: f64,
        /// Solid height in document pixels.
        height: f64,
    },
    /// A vector shape layer; geometry is external content.
    Shape(ContentRef),
    /// A bitmap layer.
    Image(ContentRef),
    /// A text layer.
    Text(ContentRef),
    /// A null (transform-only) layer; draws nothing, parents others.
    Null,
    /// A kind this build does not understand. Skipped at construction.
    Unsupported,
}

/// Animated drop-shadow effect definition.
///
/// Direction is in degrees: 0 casts straight below the layer, 90 to its
/// right. Opacity is normalized to `[0, 1]`; distance and radius are in
/// document pixels (scaled to device pixels at evaluation time).
#[derive(Clone, Debug, PartialEq)]
pub struct DropShadowEffect {
    /// Shadow color (alpha ignored; opacity is a separate channel).
    pub color: Animated<Color>,
    /// Shadow opacity in `[0, 1]`.
    pub opacity: Animated<f32>,
    /// Cast direction in degrees.
    pub direction: Animated<f32>,
    /// Cast distance in document pixels.
    pub distance: Animated<f32>,
    /// Softness radius in document pixels.
    pub radius: Animated<f32>,
}

/// Animated Gaussian-blur effect definition.
#[derive(Clone, Debug, PartialEq)]
pub struct BlurEffect {
    /// Blur radius in document pixels.
    pub radius: Animated<f32>,
}

/// One layer of a composition, as authored.
///
/// The list order is visual stacking order: the first model in a list is the
/// topmost-declared layer and paints last. Fields not meaningful for a kind
/// (say, precomp dimensions on a null layer) stay at their defaults and are
/// ignored.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerModel {
    /// Identity within the owning layer list.
    pub id: LayerId,
    /// Display name; used by key-path resolution.
    pub name: String,
    /// Parent layer id, if any. Dangling ids are tolerated.
    pub parent: Option<LayerId>,
    /// Track-matte declaration. A non-`None` mode consumes the model
    /// immediately above this one as the matte source.
    pub matte_mode: MatteMode,
    /// Kind-specific payload.
    pub kind: LayerKind,
    /// Declared precomposition width in pixels (clip rectangle source).
    pub precomp_width: f64,
    /// Declared precomposition height in pixels (clip rectangle source).
    pub precomp_height: f64,
    /// Progress offset subtracted when no time remap is bound.
    pub start_progress: f32,
    /// Local playback speed divisor; 1 is real time, 0 is tolerated and
    /// skipped.
    pub time_stretch: f32,
    /// Optional time remap track, in seconds as a function of progress.
    pub time_remap: Option<Animated<f32>>,
    /// Optional drop-shadow effect.
    pub drop_shadow: Option<DropShadowEffect>,
    /// Optional blur effect.
    pub blur: Option<BlurEffect>,
    /// Animated local transform.
    pub transform: AnimatedTransform,
    /// Animated layer opacity in `[0, 1]`.
    pub opacity: Animated<f32>,
    /// Number of alpha masks authored on this layer. Mask geometry is
    /// external; only presence matters here.
    pub mask_count: u32,
}

impl LayerModel {
    /// Creates a model with the given identity and kind; every other field
    /// takes its neutral default.
    #[must_use]
    pub fn new(id: LayerId, name: impl Into<String>, kind: LayerKind) -> Self {
        Self {
            id,
            name: name.into(),
            parent: None,
            matte_mode: MatteMode::None,
            kind,
            precomp_width: 0.0,
            precomp_height: 0.0,
            start_progress: 0.0,
            time_stretch: 1.0,
            time_remap: None,
            drop_shadow: None,
            blur: None,
            transform: AnimatedTransform::default(),
            opacity: Animated::constant(1.0),
            mask_count: 0,
        }
    }

    /// Creates the implicit root container model for a document of the given
    /// pixel size.
    #[must_use]
    pub fn container(width: f64, height: f64) -> Self {
        let mut model = Self::new(
            LayerId(u64::MAX),
            CONTAINER_NAME,
            LayerKind::Precomp {
                asset: String::new(),
            },
        );
        model.precomp_width = width;
        model.precomp_height = height;
        model
    }

    /// Whether this model is the implicit root container.
    #[inline]
    #[must_use]
    pub fn is_container(&self) -> bool {
        self.name == CONTAINER_NAME
    }
}

/// An already-parsed animation document.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    /// Document width in pixels.
    pub width: f64,
    /// Document height in pixels.
    pub height: f64,
    /// Frames per second.
    pub frame_rate: f32,
    /// First frame of the timeline.
    pub start_frame: f32,
    /// One past the last frame of the timeline.
    pub end_frame: f32,
    /// Root composition layers, topmost-declared first.
    pub layers: Vec<LayerModel>,
    /// Precomposition assets: asset id to layer list.
    pub precomps: BTreeMap<String, Vec<LayerModel>>,
}

impl Document {
    /// Creates an empty document with the given canvas and timeline.
    #[must_use]
    pub fn new(width: f64, height: f64, frame_rate: f32, start_frame: f32, end_frame: f32) -> Self {
        Self {
            width,
            height,
            frame_rate,
            start_frame,
            end_frame,
            layers: Vec::new(),
            precomps: BTreeMap::new(),
        }
    }

    /// Total timeline length in frames.
    #[inline]
    #[must_use]
    pub fn duration_frames(&self) -> f32 {
        self.end_frame - self.start_frame
    }

    /// Looks up a precomposition asset's layer list.
    #[must_use]
    pub fn precomp(&self, asset: &str) -> Option<&[LayerModel]> {
        self.precomps.get(asset).map(Vec::as_slice)
    }
}
