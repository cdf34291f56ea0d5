// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Runtime layer tree.
//!
//! A [`Layer`] is one node of the tree built from a [`Document`]. Every
//! layer shares a chassis:
//!
//! - The sampled state for the current progress: local transform affine and
//!   opacity factor.
//! - Structural links assigned at construction: an optional parent (arena
//!   index, transforms only) and an optional matte source (arena index,
//!   consumed from the paintable list).
//! - Optional [`ShadowAnimation`]/[`BlurAnimation`] evaluators.
//!
//! On top of the chassis sits a closed set of bodies, chosen once from the
//! model's kind: solid, shape, image, text, null, or a nested composition.
//! The composition body owns its children in an arena and carries the full
//! draw/progress/bounds/key-path orchestration described in
//! [`composition`]; construction and relationship resolution live in
//! [`resolve`].
//!
//! The chassis draw path also implements what every variant shares: parent
//! transform chaining, opacity folding, matte compositing
//! (destination-in/-out passes), and wrapping leaf content in a local
//! offscreen pass when a shadow or blur reaches it.
//!
//! [`Document`]: crate::model::Document

mod composition;
mod resolve;

use alloc::vec::Vec;
use core::fmt;

use kurbo::{Affine, Rect};

use crate::effects::{
    BlurAnimation, ColorProvider, DropShadow, ScalarProvider, ShadowAnimation, scale_alpha,
};
use crate::keypath::KeyPath;
use crate::model::{Color, ContentRef, Document, LayerId, LayerKind, LayerModel, MatteMode};
use crate::surface::{BlendMode, ComposeOp, Surface};
use crate::trace::{SkipReason, Tracer};

use composition::Composition;

/// Debug tint painted over masked or matted layers when outlining is on.
const OUTLINE_TINT: Color = Color::rgb8(252, 32, 32);

/// Host flags fixed at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderSettings {
    /// Flatten multi-child groups through an offscreen pass when drawn at
    /// partial alpha, instead of applying alpha per child.
    pub apply_opacity_to_layers: bool,
    /// Flatten subtrees through an offscreen pass when a shadow or blur
    /// applies to them.
    pub apply_effects_to_layers: bool,
    /// Clip the root container to the document's declared bounds rather
    /// than the union of its children's bounds.
    pub clip_to_composition_bounds: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            apply_opacity_to_layers: false,
            apply_effects_to_layers: true,
            clip_to_composition_bounds: true,
        }
    }
}

/// A dynamic override for one animatable property of a layer.
///
/// `None` in a variant clears a previously installed override; the document
/// track, if one exists, takes effect again. Installing an override on a
/// layer that never declared the property is inert.
pub enum PropertyOverride {
    /// Replaces the time-remap track of a composition layer. The provider
    /// maps progress to remapped seconds.
    TimeRemap(Option<ScalarProvider>),
    /// Replaces the drop-shadow color track.
    DropShadowColor(Option<ColorProvider>),
    /// Replaces the drop-shadow opacity track.
    DropShadowOpacity(Option<ScalarProvider>),
    /// Replaces the drop-shadow direction track.
    DropShadowDirection(Option<ScalarProvider>),
    /// Replaces the drop-shadow distance track.
    DropShadowDistance(Option<ScalarProvider>),
    /// Replaces the drop-shadow radius track.
    DropShadowRadius(Option<ScalarProvider>),
    /// Replaces the blur radius track.
    BlurRadius(Option<ScalarProvider>),
}

impl fmt::Debug for PropertyOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TimeRemap(_) => "TimeRemap",
            Self::DropShadowColor(_) => "DropShadowColor",
            Self::DropShadowOpacity(_) => "DropShadowOpacity",
            Self::DropShadowDirection(_) => "DropShadowDirection",
            Self::DropShadowDistance(_) => "DropShadowDistance",
            Self::DropShadowRadius(_) => "DropShadowRadius",
            Self::BlurRadius(_) => "BlurRadius",
        };
        f.debug_tuple(name).finish()
    }
}

/// Shared per-layer state, common to every body.
#[derive(Debug)]
pub(crate) struct Base {
    pub(crate) model: LayerModel,
    /// Arena index of the transform parent, within the owning composition.
    pub(crate) parent: Option<usize>,
    /// Arena index of the matte source this layer consumes.
    pub(crate) matte: Option<usize>,
    pub(crate) progress: f32,
    /// `model.transform` sampled at `progress`.
    pub(crate) local_transform: Affine,
    /// `model.opacity` sampled at `progress`, clamped to `[0, 1]`.
    pub(crate) alpha_factor: f32,
    pub(crate) shadow: Option<ShadowAnimation>,
    pub(crate) blur: Option<BlurAnimation>,
    pub(crate) outline_masks_and_mattes: bool,
}

impl Base {
    fn new(model: LayerModel) -> Self {
        let shadow = model.drop_shadow.as_ref().map(ShadowAnimation::new);
        let blur = model.blur.as_ref().map(BlurAnimation::new);
        let local_transform = model.transform.sample(0.0);
        let alpha_factor = model.opacity.sample(0.0).clamp(0.0, 1.0);
        Self {
            model,
            parent: None,
            matte: None,
            progress: 0.0,
            local_transform,
            alpha_factor,
            shadow,
            blur,
            outline_masks_and_mattes: false,
        }
    }

    fn advance(&mut self, progress: f32) {
        self.progress = progress;
        self.local_transform = self.model.transform.sample(progress);
        self.alpha_factor = self.model.opacity.sample(progress).clamp(0.0, 1.0);
    }
}

/// Kind-specific payload, chosen once at construction.
#[derive(Debug)]
pub(crate) enum Body {
    Composition(Composition),
    Solid {
        color: Color,
        width: f64,
        height: f64,
    },
    Shape(ContentRef),
    Image(ContentRef),
    Text(ContentRef),
    Null,
}

/// One runtime layer: the shared chassis plus its kind-specific body.
#[derive(Debug)]
pub struct Layer {
    pub(crate) base: Base,
    pub(crate) body: Body,
}

impl Layer {
    /// Builds the runtime tree for a whole document.
    ///
    /// The returned layer is the implicit root container (named
    /// [`CONTAINER_NAME`](crate::model::CONTAINER_NAME)) owning every root
    /// layer of the document. Construction never fails; malformed
    /// relationships degrade to missing links and unknown kinds are
    /// skipped.
    #[must_use]
    pub fn from_document(document: &Document, settings: RenderSettings) -> Self {
        Self::from_document_traced(document, settings, &mut Tracer::none())
    }

    /// Like [`from_document`](Self::from_document), reporting construction
    /// diagnostics to `tracer`.
    #[must_use]
    pub fn from_document_traced(
        document: &Document,
        settings: RenderSettings,
        tracer: &mut Tracer<'_>,
    ) -> Self {
        let model = LayerModel::container(document.width, document.height);
        let body = Body::Composition(Composition::new(
            &model,
            &document.layers,
            document,
            settings,
            tracer,
        ));
        Self {
            base: Base::new(model),
            body,
        }
    }

    /// Constructs the runtime layer for one model, or reports why none can
    /// be built.
    pub(crate) fn from_model(
        model: &LayerModel,
        document: &Document,
        settings: RenderSettings,
        tracer: &mut Tracer<'_>,
    ) -> Result<Self, SkipReason> {
        let body = match &model.kind {
            LayerKind::Precomp { asset } => {
                let Some(children) = document.precomp(asset) else {
                    return Err(SkipReason::MissingPrecompAsset);
                };
                Body::Composition(Composition::new(model, children, document, settings, tracer))
            }
            LayerKind::Solid {
                color,
                width,
                height,
            } => Body::Solid {
                color: *color,
                width: *width,
                height: *height,
            },
            LayerKind::Shape(content) => Body::Shape(content.clone()),
            LayerKind::Image(content) => Body::Image(content.clone()),
            LayerKind::Text(content) => Body::Text(content.clone()),
            LayerKind::Null => Body::Null,
            LayerKind::Unsupported => return Err(SkipReason::UnsupportedKind),
        };
        Ok(Self {
            base: Base::new(model.clone()),
            body,
        })
    }

    /// The layer's identity.
    #[inline]
    #[must_use]
    pub fn id(&self) -> LayerId {
        self.base.model.id
    }

    /// The layer's display name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.base.model.name
    }

    /// The progress this layer was last advanced to.
    #[inline]
    #[must_use]
    pub fn progress(&self) -> f32 {
        self.base.progress
    }

    /// Number of paintable children (zero for leaf bodies). Matte sources
    /// are owned but not counted here.
    #[must_use]
    pub fn paintable_children(&self) -> usize {
        match &self.body {
            Body::Composition(c) => c.paintable.len(),
            _ => 0,
        }
    }

    /// Whether this layer itself carries alpha masks.
    #[inline]
    #[must_use]
    pub fn has_masks_on_this_layer(&self) -> bool {
        self.base.model.mask_count > 0
    }

    /// Whether this layer itself consumes a matte source.
    #[inline]
    #[must_use]
    pub fn has_matte_on_this_layer(&self) -> bool {
        self.base.matte.is_some()
    }

    /// Whether any layer of this subtree carries alpha masks.
    ///
    /// Memoized on first call for composition bodies; leaves answer their
    /// own mask flag.
    #[must_use]
    pub fn has_masks(&self) -> bool {
        match &self.body {
            Body::Composition(c) => c.has_masks(),
            _ => self.has_masks_on_this_layer(),
        }
    }

    /// Whether this layer or any direct paintable child consumes a matte.
    ///
    /// Memoized on first call for composition bodies. Checks one level of
    /// children, not nested compositions' subtrees.
    #[must_use]
    pub fn has_matte(&self) -> bool {
        match &self.body {
            Body::Composition(c) => c.has_matte(&self.base),
            _ => self.has_matte_on_this_layer(),
        }
    }

    /// Advances this layer (and, for compositions, every descendant) to a
    /// normalized progress.
    ///
    /// Composition bodies derive their children's local progress from the
    /// time-remap track or the start-progress offset, then the time
    /// stretch; see the module docs of [`composition`] internals for the
    /// exact derivation order.
    pub fn set_progress(&mut self, progress: f32) {
        self.base.advance(progress);
        if let Body::Composition(c) = &mut self.body {
            let derived = c.derive_progress(&self.base.model, progress);
            c.propagate(derived);
        }
    }

    /// Recursively toggles the debug tint over masked and matted layers.
    pub fn set_outline_masks_and_mattes(&mut self, outline: bool) {
        self.base.outline_masks_and_mattes = outline;
        if let Body::Composition(c) = &mut self.body {
            for child in &mut c.arena {
                child.set_outline_masks_and_mattes(outline);
            }
        }
    }

    /// Installs, replaces, or clears a dynamic property override.
    ///
    /// Time remap targets composition bodies; the effect properties target
    /// whichever evaluator the layer declared. Unmatched overrides are
    /// inert.
    pub fn set_value_override(&mut self, value: PropertyOverride) {
        match value {
            PropertyOverride::TimeRemap(provider) => {
                if let Body::Composition(c) = &mut self.body {
                    c.remap_override = provider;
                }
            }
            PropertyOverride::DropShadowColor(provider) => {
                if let Some(shadow) = &mut self.base.shadow {
                    shadow.set_color_override(provider);
                }
            }
            PropertyOverride::DropShadowOpacity(provider) => {
                if let Some(shadow) = &mut self.base.shadow {
                    shadow.set_opacity_override(provider);
                }
            }
            PropertyOverride::DropShadowDirection(provider) => {
                if let Some(shadow) = &mut self.base.shadow {
                    shadow.set_direction_override(provider);
                }
            }
            PropertyOverride::DropShadowDistance(provider) => {
                if let Some(shadow) = &mut self.base.shadow {
                    shadow.set_distance_override(provider);
                }
            }
            PropertyOverride::DropShadowRadius(provider) => {
                if let Some(shadow) = &mut self.base.shadow {
                    shadow.set_radius_override(provider);
                }
            }
            PropertyOverride::BlurRadius(provider) => {
                if let Some(blur) = &mut self.base.blur {
                    blur.set_radius_override(provider);
                }
            }
        }
    }

    /// Draws this layer into `surface` under a parent transform, alpha,
    /// and inherited shadow/blur.
    ///
    /// `parent_shadow` and `parent_blur` are the effect obligations handed
    /// down by an enclosing composition that chose not to flatten them
    /// itself; passing `None` / `0.0` draws the layer plain.
    pub fn draw(
        &self,
        surface: &mut dyn Surface,
        parent_transform: Affine,
        parent_alpha: u8,
        parent_shadow: Option<&DropShadow>,
        parent_blur: f32,
    ) {
        self.draw_in(&[], surface, parent_transform, parent_alpha, parent_shadow, parent_blur);
    }

    /// Appends every concrete path matching `pattern` to `accumulator`.
    ///
    /// `depth` is the pattern segment this layer is matched against and
    /// `partial` the concrete path of the ancestors; external callers start
    /// with `0` and an empty path.
    pub fn resolve_key_path(
        &self,
        pattern: &KeyPath,
        depth: usize,
        accumulator: &mut Vec<KeyPath>,
        partial: &KeyPath,
    ) {
        let name = self.base.model.name.as_str();
        if !pattern.matches(name, depth) {
            return;
        }
        let extended;
        let current: &KeyPath = if self.base.model.is_container() {
            partial
        } else {
            extended = partial.with_key(name);
            if pattern.fully_resolves_to(name, depth) {
                accumulator.push(extended.clone());
            }
            &extended
        };
        if pattern.propagate_to_children(name, depth) {
            let child_depth = depth + pattern.increment_depth_by(name, depth);
            if let Body::Composition(c) = &self.body {
                c.resolve_child_key_path(pattern, child_depth, accumulator, current);
            }
        }
    }

    /// Union bounding rect of this subtree in device space.
    ///
    /// `apply_parents` composes the layer's parent chain under `transform`
    /// first; child bounds inside compositions always apply their parents.
    #[must_use]
    pub fn bounds(&self, transform: Affine, apply_parents: bool) -> Rect {
        self.bounds_in(&[], transform, apply_parents)
    }

    // ----- chassis internals, parameterized over the owning arena --------

    pub(crate) fn bounds_in(
        &self,
        siblings: &[Self],
        transform: Affine,
        apply_parents: bool,
    ) -> Rect {
        let mut matrix = transform;
        if apply_parents {
            matrix *= ancestors_transform(siblings, self.base.parent);
        }
        matrix *= self.base.local_transform;

        let own = union_nonempty(None, matrix.transform_rect_bbox(self.content_rect()));
        match &self.body {
            Body::Composition(c) => c.bounds(own, matrix),
            _ => own.unwrap_or(Rect::ZERO),
        }
    }

    pub(crate) fn draw_in(
        &self,
        siblings: &[Self],
        surface: &mut dyn Surface,
        parent_transform: Affine,
        parent_alpha: u8,
        parent_shadow: Option<&DropShadow>,
        parent_blur: f32,
    ) {
        let full = parent_transform
            * ancestors_transform(siblings, self.base.parent)
            * self.base.local_transform;
        let alpha = scale_alpha(parent_alpha, self.base.alpha_factor);

        match self.base.matte {
            Some(source) => {
                // Content and matte render into a private group so the
                // matte's alpha only affects this layer.
                let group = union_nonempty(
                    union_nonempty(None, self.bounds_in(siblings, parent_transform, true)),
                    siblings[source].bounds_in(siblings, parent_transform, true),
                )
                .unwrap_or(Rect::ZERO);
                let blend = match self.base.model.matte_mode {
                    MatteMode::Invert => BlendMode::DestOut,
                    _ => BlendMode::DestIn,
                };
                surface.begin_layer(group, &ComposeOp::opaque());
                self.draw_body(surface, full, alpha, parent_shadow, parent_blur);
                surface.begin_layer(group, &ComposeOp::with_blend(blend));
                siblings[source].draw_in(
                    siblings,
                    surface,
                    parent_transform,
                    alpha,
                    None,
                    0.0,
                );
                surface.end_layer();
                surface.end_layer();
            }
            None => self.draw_body(surface, full, alpha, parent_shadow, parent_blur),
        }

        if self.base.outline_masks_and_mattes
            && (self.has_matte_on_this_layer() || self.has_masks_on_this_layer())
        {
            surface.fill_rect(self.content_rect(), full, OUTLINE_TINT, 50);
        }
    }

    fn draw_body(
        &self,
        surface: &mut dyn Surface,
        transform: Affine,
        alpha: u8,
        parent_shadow: Option<&DropShadow>,
        parent_blur: f32,
    ) {
        match &self.body {
            Body::Composition(c) => {
                c.draw(&self.base, surface, transform, alpha, parent_shadow, parent_blur);
            }
            Body::Null => {}
            _ => self.draw_leaf(surface, transform, alpha, parent_shadow, parent_blur),
        }
    }

    /// Leaf draw: resolve this layer's own effects, then blit the content,
    /// through a local offscreen pass when a shadow or blur remains to be
    /// applied here.
    fn draw_leaf(
        &self,
        surface: &mut dyn Surface,
        transform: Affine,
        alpha: u8,
        parent_shadow: Option<&DropShadow>,
        parent_blur: f32,
    ) {
        let mut blur = parent_blur;
        if let Some(b) = &self.base.blur {
            blur += b.evaluate(self.base.progress, transform);
        }
        let own_shadow = self
            .base
            .shadow
            .as_ref()
            .map(|s| s.evaluate(self.base.progress, transform, alpha));
        let shadow = own_shadow.as_ref().or(parent_shadow);

        if shadow.is_some() || blur > 0.0 {
            let bounds = transform.transform_rect_bbox(self.content_rect());
            let op = ComposeOp {
                alpha: 255,
                blend: BlendMode::SrcOver,
                shadow: shadow.copied(),
                blur,
            };
            surface.begin_layer(bounds, &op);
            self.blit_content(surface, transform, alpha);
            surface.end_layer();
        } else {
            self.blit_content(surface, transform, alpha);
        }
    }

    fn blit_content(&self, surface: &mut dyn Surface, transform: Affine, alpha: u8) {
        match &self.body {
            Body::Solid {
                color,
                width,
                height,
            } => {
                surface.fill_rect(Rect::new(0.0, 0.0, *width, *height), transform, *color, alpha);
            }
            Body::Shape(content) | Body::Image(content) | Body::Text(content) => {
                surface.draw_content(
                    content.id,
                    Rect::new(0.0, 0.0, content.width, content.height),
                    transform,
                    alpha,
                );
            }
            Body::Composition(_) | Body::Null => {}
        }
    }

    /// The layer-local rect content would cover, before any transform.
    fn content_rect(&self) -> Rect {
        match &self.body {
            Body::Composition(_) => Rect::new(
                0.0,
                0.0,
                self.base.model.precomp_width,
                self.base.model.precomp_height,
            ),
            Body::Solid { width, height, .. } => Rect::new(0.0, 0.0, *width, *height),
            Body::Shape(content) | Body::Image(content) | Body::Text(content) => {
                Rect::new(0.0, 0.0, content.width, content.height)
            }
            Body::Null => Rect::ZERO,
        }
    }
}

/// Product of the local transforms along a parent chain, outermost
/// ancestor first.
///
/// Cycles in parent links are undefined behavior at the document level and
/// recurse forever here; well-formedness is the producer's contract.
fn ancestors_transform(siblings: &[Layer], parent: Option<usize>) -> Affine {
    match parent {
        None => Affine::IDENTITY,
        Some(index) => {
            let layer = &siblings[index];
            ancestors_transform(siblings, layer.base.parent) * layer.base.local_transform
        }
    }
}

/// Folds a rect into an optional union, ignoring empty rects so zero-area
/// bounds never drag a union toward the origin.
pub(crate) fn union_nonempty(acc: Option<Rect>, rect: Rect) -> Option<Rect> {
    if rect.width() <= 0.0 || rect.height() <= 0.0 {
        return acc;
    }
    Some(match acc {
        None => rect,
        Some(a) => a.union(rect),
    })
}
