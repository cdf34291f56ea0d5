// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The composition body: a layer that owns and orchestrates children.
//!
//! Children live in an arena ([`Composition::arena`]); the paintable list
//! holds arena indices in painting order, bottommost first. Matte sources
//! are in the arena but not in the paintable list, and are reached only
//! through their consumer.
//!
//! Progress fans out from here: the composition derives its children's
//! local progress from the time-remap track (or the start-progress
//! offset), divides by the time stretch, then advances every child and
//! every matte source. Drawing clips to the declared bounds, decides
//! whether to flatten through one offscreen pass, and hands unflattened
//! shadow/blur obligations down to the children.

use alloc::vec::Vec;
use core::cell::Cell;
use core::fmt;

use kurbo::{Affine, Rect};

use crate::animated::Animated;
use crate::effects::{DropShadow, ScalarProvider};
use crate::keypath::KeyPath;
use crate::model::{Document, LayerModel};
use crate::surface::{BlendMode, ComposeOp, Surface};
use crate::trace::Tracer;

use super::resolve;
use super::{Base, Body, Layer, RenderSettings, union_nonempty};

/// Child-owning state of a composition layer.
pub(crate) struct Composition {
    /// Every constructed child, matte sources included.
    pub(crate) arena: Vec<Layer>,
    /// Arena indices in painting order, bottommost first.
    pub(crate) paintable: Vec<usize>,
    /// Dynamic replacement for the time-remap track.
    pub(crate) remap_override: Option<ScalarProvider>,
    /// Document time-remap track, mapping progress to remapped seconds.
    remap: Option<Animated<f32>>,
    frame_rate: f32,
    document_start_frame: f32,
    document_duration_frames: f32,
    settings: RenderSettings,
    has_masks: Cell<Option<bool>>,
    has_matte: Cell<Option<bool>>,
}

impl fmt::Debug for Composition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composition")
            .field("arena", &self.arena)
            .field("paintable", &self.paintable)
            .field("remap", &self.remap)
            .field("remap_override", &self.remap_override.is_some())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Composition {
    pub(crate) fn new(
        model: &LayerModel,
        models: &[LayerModel],
        document: &Document,
        settings: RenderSettings,
        tracer: &mut Tracer<'_>,
    ) -> Self {
        let (arena, paintable) = resolve::build_list(models, document, settings, tracer);
        Self {
            arena,
            paintable,
            remap_override: None,
            remap: model.time_remap.clone(),
            frame_rate: document.frame_rate,
            document_start_frame: document.start_frame,
            document_duration_frames: document.duration_frames(),
            settings,
            has_masks: Cell::new(None),
            has_matte: Cell::new(None),
        }
    }

    /// Maps the composition's own progress to its children's local
    /// progress.
    ///
    /// A remap override, or else the document remap track, yields remapped
    /// seconds which are converted back through the document's frame rate
    /// and start frame. Without a remap the start-progress offset is
    /// subtracted instead. Either result is then divided by the time
    /// stretch, except on the root container.
    pub(crate) fn derive_progress(&self, model: &LayerModel, progress: f32) -> f32 {
        let mut derived = progress;
        let remapped = match (&self.remap_override, &self.remap) {
            (Some(provider), _) => Some(provider(progress)),
            (None, Some(track)) => Some(track.sample(progress)),
            (None, None) => None,
        };
        match remapped {
            Some(seconds) => {
                let duration = self.document_duration_frames + 0.01;
                let frames = seconds * self.frame_rate - self.document_start_frame;
                derived = frames / duration;
            }
            None => derived -= model.start_progress,
        }
        if model.time_stretch != 0.0 && !model.is_container() {
            derived /= model.time_stretch;
        }
        derived
    }

    /// Advances every child and every matte source to `progress`.
    pub(crate) fn propagate(&mut self, progress: f32) {
        for position in 0..self.paintable.len() {
            let child = self.paintable[position];
            self.arena[child].set_progress(progress);
            if let Some(source) = self.arena[child].base.matte {
                self.arena[source].set_progress(progress);
            }
        }
    }

    /// Draws the children under this composition's clip, flattening them
    /// through one offscreen pass when opacity or an effect calls for it.
    ///
    /// Shadow resolution is innermost-wins: this composition's own shadow
    /// evaluator, if any, replaces an inherited one. When the subtree is
    /// flattened, the resolved shadow and the accumulated blur ride on the
    /// offscreen composite and the children draw free of them; otherwise
    /// both are handed down as-is.
    pub(crate) fn draw(
        &self,
        base: &Base,
        surface: &mut dyn Surface,
        transform: Affine,
        parent_alpha: u8,
        parent_shadow: Option<&DropShadow>,
        parent_blur: f32,
    ) {
        let mut blur = parent_blur;
        if let Some(b) = &base.blur {
            blur += b.evaluate(base.progress, transform);
        }
        let has_shadow = base.shadow.is_some() || parent_shadow.is_some();

        let offscreen = (self.settings.apply_opacity_to_layers
            && self.paintable.len() > 1
            && parent_alpha != 255)
            || ((has_shadow || blur > 0.0) && self.settings.apply_effects_to_layers);
        let child_alpha = if offscreen { 255 } else { parent_alpha };

        let own_shadow = base
            .shadow
            .as_ref()
            .map(|s| s.evaluate(base.progress, transform, child_alpha));
        let shadow = own_shadow.as_ref().or(parent_shadow);

        let clip = if self.settings.clip_to_composition_bounds || !base.model.is_container() {
            transform.transform_rect_bbox(Rect::new(
                0.0,
                0.0,
                base.model.precomp_width,
                base.model.precomp_height,
            ))
        } else {
            self.bounds(None, transform)
        };

        surface.save();
        let visible = surface.clip_rect(clip);

        let (child_shadow, child_blur) = if offscreen {
            let op = ComposeOp {
                alpha: parent_alpha,
                blend: BlendMode::SrcOver,
                shadow: shadow.copied(),
                blur,
            };
            surface.begin_layer(clip, &op);
            (None, 0.0)
        } else {
            (shadow, blur)
        };

        if visible {
            for &child in &self.paintable {
                self.arena[child].draw_in(
                    &self.arena,
                    surface,
                    transform,
                    child_alpha,
                    child_shadow,
                    child_blur,
                );
            }
        }

        if offscreen {
            surface.end_layer();
        }
        surface.restore();
    }

    /// Unions the children's bounds into `seed`. Children compose their
    /// parent chains under `transform`; matte sources contribute nothing
    /// of their own.
    pub(crate) fn bounds(&self, seed: Option<Rect>, transform: Affine) -> Rect {
        let mut acc = seed;
        for &child in self.paintable.iter().rev() {
            acc = union_nonempty(acc, self.arena[child].bounds_in(&self.arena, transform, true));
        }
        acc.unwrap_or(Rect::ZERO)
    }

    /// Whether any layer of this subtree carries alpha masks. Only
    /// shape-bodied layers can; compositions recurse. Computed once,
    /// remembered thereafter.
    pub(crate) fn has_masks(&self) -> bool {
        if let Some(cached) = self.has_masks.get() {
            return cached;
        }
        for &child in self.paintable.iter().rev() {
            let layer = &self.arena[child];
            let found = match &layer.body {
                Body::Composition(inner) => inner.has_masks(),
                Body::Shape(_) => layer.has_masks_on_this_layer(),
                _ => false,
            };
            if found {
                self.has_masks.set(Some(true));
                return true;
            }
        }
        self.has_masks.set(Some(false));
        false
    }

    /// Whether this layer or any direct paintable child consumes a matte.
    /// One level deep; nested compositions answer for themselves. Computed
    /// once, remembered thereafter.
    pub(crate) fn has_matte(&self, base: &Base) -> bool {
        if let Some(cached) = self.has_matte.get() {
            return cached;
        }
        if base.matte.is_some() {
            self.has_matte.set(Some(true));
            return true;
        }
        for &child in self.paintable.iter().rev() {
            if self.arena[child].has_matte_on_this_layer() {
                self.has_matte.set(Some(true));
                return true;
            }
        }
        self.has_matte.set(Some(false));
        false
    }

    /// Fans key-path resolution out to the paintable children, topmost
    /// declared first so results follow document order.
    pub(crate) fn resolve_child_key_path(
        &self,
        pattern: &KeyPath,
        depth: usize,
        accumulator: &mut Vec<KeyPath>,
        partial: &KeyPath,
    ) {
        for &child in self.paintable.iter().rev() {
            self.arena[child].resolve_key_path(pattern, depth, accumulator, partial);
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::borrow::ToOwned;
    use alloc::boxed::Box;
    use alloc::string::String;
    use alloc::vec;
    use alloc::vec::Vec;

    use kurbo::Vec2;

    use crate::animated::{Animated, Keyframe};
    use crate::model::{
        BlurEffect, Color, ContentId, ContentRef, Document, DropShadowEffect, LayerId, LayerKind,
        LayerModel, MatteMode,
    };
    use crate::surface::Surface;

    use super::super::PropertyOverride;
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    enum Op {
        Save,
        Restore,
        Clip(Rect),
        Fill {
            rect: Rect,
            transform: Affine,
            color: Color,
            alpha: u8,
        },
        Content {
            id: ContentId,
            alpha: u8,
        },
        Begin {
            bounds: Rect,
            alpha: u8,
            blend: BlendMode,
            shadow: bool,
            blur: f32,
        },
        End,
    }

    /// Records the op stream; `clip_visible` scripts whether clips report
    /// anything left to draw.
    struct Recorder {
        ops: Vec<Op>,
        clip_visible: bool,
    }

    impl Recorder {
        fn new() -> Self {
            Self {
                ops: Vec::new(),
                clip_visible: true,
            }
        }

        fn fills(&self) -> Vec<(Color, u8)> {
            self.ops
                .iter()
                .filter_map(|op| match op {
                    Op::Fill { color, alpha, .. } => Some((*color, *alpha)),
                    _ => None,
                })
                .collect()
        }

        fn begins(&self) -> Vec<&Op> {
            self.ops
                .iter()
                .filter(|op| matches!(op, Op::Begin { .. }))
                .collect()
        }
    }

    impl Surface for Recorder {
        fn save(&mut self) {
            self.ops.push(Op::Save);
        }

        fn restore(&mut self) {
            self.ops.push(Op::Restore);
        }

        fn clip_rect(&mut self, rect: Rect) -> bool {
            self.ops.push(Op::Clip(rect));
            self.clip_visible && rect.width() > 0.0 && rect.height() > 0.0
        }

        fn fill_rect(&mut self, rect: Rect, transform: Affine, color: Color, alpha: u8) {
            self.ops.push(Op::Fill {
                rect,
                transform,
                color,
                alpha,
            });
        }

        fn draw_content(&mut self, id: ContentId, _bounds: Rect, _transform: Affine, alpha: u8) {
            self.ops.push(Op::Content { id, alpha });
        }

        fn begin_layer(&mut self, bounds: Rect, op: &ComposeOp) {
            self.ops.push(Op::Begin {
                bounds,
                alpha: op.alpha,
                blend: op.blend,
                shadow: op.shadow.is_some(),
                blur: op.blur,
            });
        }

        fn end_layer(&mut self) {
            self.ops.push(Op::End);
        }
    }

    const RED: Color = Color::rgb8(255, 0, 0);
    const GREEN: Color = Color::rgb8(0, 255, 0);
    const BLUE: Color = Color::rgb8(0, 0, 255);
    const GRAY: Color = Color::rgb8(128, 128, 128);

    fn document(layers: Vec<LayerModel>) -> Document {
        let mut doc = Document::new(512.0, 512.0, 24.0, 0.0, 48.0);
        doc.layers = layers;
        doc
    }

    fn solid(id: u64, name: &str, color: Color) -> LayerModel {
        LayerModel::new(
            LayerId(id),
            name,
            LayerKind::Solid {
                color,
                width: 100.0,
                height: 100.0,
            },
        )
    }

    fn shape(id: u64, name: &str) -> LayerModel {
        LayerModel::new(
            LayerId(id),
            name,
            LayerKind::Shape(ContentRef {
                id: ContentId(id as u32),
                width: 100.0,
                height: 100.0,
            }),
        )
    }

    fn precomp(id: u64, name: &str, asset: &str, width: f64, height: f64) -> LayerModel {
        let mut model = LayerModel::new(
            LayerId(id),
            name,
            LayerKind::Precomp {
                asset: asset.to_owned(),
            },
        );
        model.precomp_width = width;
        model.precomp_height = height;
        model
    }

    fn at(mut model: LayerModel, x: f64, y: f64) -> LayerModel {
        model.transform.position = Animated::constant(Vec2::new(x, y));
        model
    }

    fn root(doc: &Document) -> Layer {
        Layer::from_document(doc, RenderSettings::default())
    }

    fn root_with(doc: &Document, settings: RenderSettings) -> Layer {
        Layer::from_document(doc, settings)
    }

    /// The paintable child at `position` (bottom-first).
    fn paintable_child(layer: &Layer, position: usize) -> &Layer {
        match &layer.body {
            Body::Composition(c) => &c.arena[c.paintable[position]],
            _ => panic!("layer has no children"),
        }
    }

    #[test]
    fn draws_children_bottom_first() {
        // Declaration order is topmost first, so blue paints first.
        let doc = document(vec![
            solid(1, "top", RED),
            solid(2, "mid", GREEN),
            solid(3, "bottom", BLUE),
        ]);
        let tree = root(&doc);
        let mut rec = Recorder::new();
        tree.draw(&mut rec, Affine::IDENTITY, 255, None, 0.0);
        assert_eq!(
            rec.fills(),
            vec![(BLUE, 255), (GREEN, 255), (RED, 255)],
            "painting must run bottom to top"
        );
    }

    #[test]
    fn plain_draw_emits_exact_protocol() {
        let doc = document(vec![solid(1, "only", RED)]);
        let tree = root(&doc);
        let mut rec = Recorder::new();
        tree.draw(&mut rec, Affine::IDENTITY, 255, None, 0.0);
        assert_eq!(
            rec.ops,
            vec![
                Op::Save,
                Op::Clip(Rect::new(0.0, 0.0, 512.0, 512.0)),
                Op::Fill {
                    rect: Rect::new(0.0, 0.0, 100.0, 100.0),
                    transform: Affine::IDENTITY,
                    color: RED,
                    alpha: 255,
                },
                Op::Restore,
            ],
            "one unflattened child draws inside a single save/clip scope"
        );
    }

    #[test]
    fn clip_rect_follows_parent_transform() {
        let doc = document(vec![solid(1, "only", RED)]);
        let tree = root(&doc);
        let mut rec = Recorder::new();
        tree.draw(&mut rec, Affine::scale(2.0), 255, None, 0.0);
        assert_eq!(
            rec.ops[1],
            Op::Clip(Rect::new(0.0, 0.0, 1024.0, 1024.0)),
            "declared bounds map through the draw transform"
        );
    }

    #[test]
    fn empty_clip_skips_children_but_stays_balanced() {
        let doc = document(vec![solid(1, "only", RED)]);
        let tree = root(&doc);
        let mut rec = Recorder::new();
        rec.clip_visible = false;
        tree.draw(&mut rec, Affine::IDENTITY, 255, None, 0.0);
        assert_eq!(
            rec.ops,
            vec![
                Op::Save,
                Op::Clip(Rect::new(0.0, 0.0, 512.0, 512.0)),
                Op::Restore,
            ],
            "an empty clip draws nothing yet still unwinds its save"
        );
    }

    #[test]
    fn disabled_clip_unions_child_bounds_on_container() {
        let doc = document(vec![at(solid(1, "far", RED), 600.0, 0.0)]);
        let settings = RenderSettings {
            clip_to_composition_bounds: false,
            ..RenderSettings::default()
        };
        let tree = root_with(&doc, settings);
        let mut rec = Recorder::new();
        tree.draw(&mut rec, Affine::IDENTITY, 255, None, 0.0);
        assert_eq!(
            rec.ops[1],
            Op::Clip(Rect::new(600.0, 0.0, 700.0, 100.0)),
            "container clip falls back to the union of child bounds"
        );
    }

    #[test]
    fn nested_precomp_always_clips_to_declared_bounds() {
        let mut doc = document(vec![precomp(1, "pre", "a", 200.0, 150.0)]);
        doc.precomps
            .insert("a".to_owned(), vec![solid(2, "inner", RED)]);
        let settings = RenderSettings {
            clip_to_composition_bounds: false,
            ..RenderSettings::default()
        };
        let tree = root_with(&doc, settings);
        let mut rec = Recorder::new();
        tree.draw(&mut rec, Affine::IDENTITY, 255, None, 0.0);
        // Root container unions child bounds; the nested precomp still
        // clips to its own declared rect.
        assert_eq!(rec.ops[1], Op::Clip(Rect::new(0.0, 0.0, 200.0, 150.0)));
        assert_eq!(rec.ops[3], Op::Clip(Rect::new(0.0, 0.0, 200.0, 150.0)));
    }

    #[test]
    fn parent_chain_composes_ancestor_transforms() {
        let mut anchor = LayerModel::new(LayerId(1), "rig", LayerKind::Null);
        anchor.transform.position = Animated::constant(Vec2::new(10.0, 20.0));
        let mut child = at(solid(2, "arm", RED), 1.0, 2.0);
        child.parent = Some(LayerId(1));
        let doc = document(vec![anchor, child]);
        let tree = root(&doc);
        let mut rec = Recorder::new();
        tree.draw(&mut rec, Affine::IDENTITY, 255, None, 0.0);
        let expected = Affine::translate((10.0, 20.0)) * Affine::translate((1.0, 2.0));
        let fill = rec
            .ops
            .iter()
            .find_map(|op| match op {
                Op::Fill { transform, .. } => Some(*transform),
                _ => None,
            })
            .unwrap();
        assert_eq!(fill, expected, "null parent shifts the child's transform");
    }

    #[test]
    fn dangling_parent_is_ignored() {
        let mut child = at(solid(1, "orphan", RED), 5.0, 5.0);
        child.parent = Some(LayerId(999));
        let doc = document(vec![child]);
        let tree = root(&doc);
        assert!(paintable_child(&tree, 0).base.parent.is_none());
        let mut rec = Recorder::new();
        tree.draw(&mut rec, Affine::IDENTITY, 255, None, 0.0);
        assert_eq!(rec.fills(), vec![(RED, 255)]);
    }

    #[test]
    fn matte_pair_composites_through_dest_in() {
        let mut consumer = solid(3, "consumer", GREEN);
        consumer.matte_mode = MatteMode::Add;
        let doc = document(vec![
            solid(1, "front", GRAY),
            solid(2, "source", RED),
            consumer,
            solid(4, "back", BLUE),
        ]);
        let tree = root(&doc);
        assert_eq!(tree.paintable_children(), 3, "source leaves the paint list");
        assert!(tree.has_matte());

        let mut rec = Recorder::new();
        tree.draw(&mut rec, Affine::IDENTITY, 255, None, 0.0);
        let group = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert_eq!(
            rec.ops,
            vec![
                Op::Save,
                Op::Clip(Rect::new(0.0, 0.0, 512.0, 512.0)),
                Op::Fill {
                    rect: group,
                    transform: Affine::IDENTITY,
                    color: BLUE,
                    alpha: 255,
                },
                Op::Begin {
                    bounds: group,
                    alpha: 255,
                    blend: BlendMode::SrcOver,
                    shadow: false,
                    blur: 0.0,
                },
                Op::Fill {
                    rect: group,
                    transform: Affine::IDENTITY,
                    color: GREEN,
                    alpha: 255,
                },
                Op::Begin {
                    bounds: group,
                    alpha: 255,
                    blend: BlendMode::DestIn,
                    shadow: false,
                    blur: 0.0,
                },
                Op::Fill {
                    rect: group,
                    transform: Affine::IDENTITY,
                    color: RED,
                    alpha: 255,
                },
                Op::End,
                Op::End,
                Op::Fill {
                    rect: group,
                    transform: Affine::IDENTITY,
                    color: GRAY,
                    alpha: 255,
                },
                Op::Restore,
            ],
            "matte pair renders as content group then dest-in source pass"
        );
    }

    #[test]
    fn invert_matte_uses_dest_out() {
        let mut consumer = solid(2, "consumer", GREEN);
        consumer.matte_mode = MatteMode::Invert;
        let doc = document(vec![solid(1, "source", RED), consumer]);
        let tree = root(&doc);
        let mut rec = Recorder::new();
        tree.draw(&mut rec, Affine::IDENTITY, 255, None, 0.0);
        let blends: Vec<BlendMode> = rec
            .ops
            .iter()
            .filter_map(|op| match op {
                Op::Begin { blend, .. } => Some(*blend),
                _ => None,
            })
            .collect();
        assert_eq!(blends, vec![BlendMode::SrcOver, BlendMode::DestOut]);
    }

    #[test]
    fn opacity_flattening_forces_children_opaque() {
        let doc = document(vec![solid(1, "a", RED), solid(2, "b", GREEN)]);
        let settings = RenderSettings {
            apply_opacity_to_layers: true,
            ..RenderSettings::default()
        };
        let tree = root_with(&doc, settings);
        let mut rec = Recorder::new();
        tree.draw(&mut rec, Affine::IDENTITY, 128, None, 0.0);
        let begins = rec.begins();
        assert_eq!(begins.len(), 1, "group flattens through one offscreen pass");
        assert!(matches!(
            begins[0],
            Op::Begin {
                alpha: 128,
                blend: BlendMode::SrcOver,
                shadow: false,
                ..
            }
        ));
        assert_eq!(
            rec.fills(),
            vec![(GREEN, 255), (RED, 255)],
            "flattened children draw at full alpha"
        );
    }

    #[test]
    fn no_offscreen_for_single_child_or_full_alpha() {
        let settings = RenderSettings {
            apply_opacity_to_layers: true,
            ..RenderSettings::default()
        };

        let one = document(vec![solid(1, "a", RED)]);
        let tree = root_with(&one, settings);
        let mut rec = Recorder::new();
        tree.draw(&mut rec, Affine::IDENTITY, 128, None, 0.0);
        assert!(rec.begins().is_empty());
        assert_eq!(rec.fills(), vec![(RED, 128)]);

        let two = document(vec![solid(1, "a", RED), solid(2, "b", GREEN)]);
        let tree = root_with(&two, settings);
        let mut rec = Recorder::new();
        tree.draw(&mut rec, Affine::IDENTITY, 255, None, 0.0);
        assert!(rec.begins().is_empty());
    }

    #[test]
    fn opacity_flattening_off_applies_alpha_per_child() {
        let doc = document(vec![solid(1, "a", RED), solid(2, "b", GREEN)]);
        let tree = root(&doc);
        let mut rec = Recorder::new();
        tree.draw(&mut rec, Affine::IDENTITY, 128, None, 0.0);
        assert!(rec.begins().is_empty());
        assert_eq!(rec.fills(), vec![(GREEN, 128), (RED, 128)]);
    }

    fn shadow_effect() -> DropShadowEffect {
        DropShadowEffect {
            color: Animated::constant(Color::BLACK),
            opacity: Animated::constant(0.5),
            direction: Animated::constant(90.0),
            distance: Animated::constant(10.0),
            radius: Animated::constant(4.0),
        }
    }

    #[test]
    fn shadow_flattens_composition_and_clears_for_children() {
        let mut pre = precomp(1, "pre", "a", 200.0, 200.0);
        pre.drop_shadow = Some(shadow_effect());
        let mut doc = document(vec![pre]);
        doc.precomps
            .insert("a".to_owned(), vec![solid(2, "inner", RED)]);
        let tree = root(&doc);
        let mut rec = Recorder::new();
        tree.draw(&mut rec, Affine::IDENTITY, 255, None, 0.0);
        let begins = rec.begins();
        assert_eq!(begins.len(), 1, "shadow flattens exactly one pass");
        assert!(matches!(
            begins[0],
            Op::Begin {
                bounds,
                alpha: 255,
                shadow: true,
                blur,
                ..
            } if *bounds == Rect::new(0.0, 0.0, 200.0, 200.0) && *blur == 0.0
        ));
        assert_eq!(rec.fills(), vec![(RED, 255)]);
    }

    #[test]
    fn effect_flattening_off_hands_shadow_to_leaves() {
        let mut pre = precomp(1, "pre", "a", 200.0, 200.0);
        pre.drop_shadow = Some(shadow_effect());
        let mut doc = document(vec![pre]);
        doc.precomps
            .insert("a".to_owned(), vec![solid(2, "inner", RED)]);
        let settings = RenderSettings {
            apply_effects_to_layers: false,
            ..RenderSettings::default()
        };
        let tree = root_with(&doc, settings);
        let mut rec = Recorder::new();
        tree.draw(&mut rec, Affine::IDENTITY, 255, None, 0.0);
        let begins = rec.begins();
        assert_eq!(begins.len(), 1, "leaf wraps itself when nothing flattened");
        assert!(matches!(
            begins[0],
            Op::Begin { bounds, shadow: true, .. }
                if *bounds == Rect::new(0.0, 0.0, 100.0, 100.0)
        ));
    }

    fn blur_effect(radius: f32) -> BlurEffect {
        BlurEffect {
            radius: Animated::constant(radius),
        }
    }

    #[test]
    fn blur_accumulates_additively_down_the_tree() {
        let mut outer = precomp(1, "outer", "a", 512.0, 512.0);
        outer.blur = Some(blur_effect(4.0));
        let mut inner = precomp(2, "inner", "b", 512.0, 512.0);
        inner.blur = Some(blur_effect(3.0));
        let mut doc = document(vec![outer]);
        doc.precomps.insert("a".to_owned(), vec![inner]);
        doc.precomps
            .insert("b".to_owned(), vec![solid(3, "leaf", RED)]);

        let settings = RenderSettings {
            apply_effects_to_layers: false,
            ..RenderSettings::default()
        };
        let tree = root_with(&doc, settings);
        let mut rec = Recorder::new();
        tree.draw(&mut rec, Affine::IDENTITY, 255, None, 0.0);
        let blurs: Vec<f32> = rec
            .ops
            .iter()
            .filter_map(|op| match op {
                Op::Begin { blur, .. } => Some(*blur),
                _ => None,
            })
            .collect();
        assert_eq!(blurs, vec![7.0], "unflattened blur compounds at the leaf");
    }

    #[test]
    fn blur_flattening_resets_accumulation_per_pass() {
        let mut outer = precomp(1, "outer", "a", 512.0, 512.0);
        outer.blur = Some(blur_effect(4.0));
        let mut inner = precomp(2, "inner", "b", 512.0, 512.0);
        inner.blur = Some(blur_effect(3.0));
        let mut doc = document(vec![outer]);
        doc.precomps.insert("a".to_owned(), vec![inner]);
        doc.precomps
            .insert("b".to_owned(), vec![solid(3, "leaf", RED)]);

        let tree = root(&doc);
        let mut rec = Recorder::new();
        tree.draw(&mut rec, Affine::IDENTITY, 255, None, 0.0);
        let blurs: Vec<f32> = rec
            .ops
            .iter()
            .filter_map(|op| match op {
                Op::Begin { blur, .. } => Some(*blur),
                _ => None,
            })
            .collect();
        assert_eq!(
            blurs,
            vec![4.0, 3.0],
            "each flattened pass carries only its own accumulation"
        );
    }

    #[test]
    fn progress_remap_converts_seconds_to_document_progress() {
        let mut pre = precomp(1, "pre", "a", 512.0, 512.0);
        pre.time_remap = Some(Animated::constant(1.0));
        let mut doc = document(vec![pre]);
        doc.precomps
            .insert("a".to_owned(), vec![solid(2, "inner", RED)]);
        let mut tree = root(&doc);
        tree.set_progress(0.9);
        // 1 s at 24 fps is frame 24 of a 48.01-frame padded timeline.
        let expected = 24.0 / 48.01;
        let inner = paintable_child(paintable_child(&tree, 0), 0);
        assert!((inner.progress() - expected).abs() < 1e-6);
    }

    #[test]
    fn progress_offset_and_stretch_without_remap() {
        let mut pre = precomp(1, "pre", "a", 512.0, 512.0);
        pre.start_progress = 0.25;
        pre.time_stretch = 2.0;
        let mut doc = document(vec![pre]);
        doc.precomps
            .insert("a".to_owned(), vec![solid(2, "inner", RED)]);
        let mut tree = root(&doc);
        tree.set_progress(0.75);
        let inner = paintable_child(paintable_child(&tree, 0), 0);
        assert_eq!(inner.progress(), 0.25);
    }

    #[test]
    fn container_is_exempt_from_time_stretch() {
        let doc = document(vec![]);
        let mut container = LayerModel::container(512.0, 512.0);
        container.time_stretch = 2.0;
        let comp = Composition::new(
            &container,
            &[],
            &doc,
            RenderSettings::default(),
            &mut Tracer::none(),
        );
        assert_eq!(comp.derive_progress(&container, 0.5), 0.5);

        let mut stretched = precomp(1, "pre", "a", 512.0, 512.0);
        stretched.time_stretch = 2.0;
        assert_eq!(comp.derive_progress(&stretched, 0.5), 0.25);
    }

    #[test]
    fn zero_time_stretch_is_left_alone() {
        let doc = document(vec![]);
        let comp = Composition::new(
            &LayerModel::container(512.0, 512.0),
            &[],
            &doc,
            RenderSettings::default(),
            &mut Tracer::none(),
        );
        let mut degenerate = precomp(1, "pre", "a", 512.0, 512.0);
        degenerate.time_stretch = 0.0;
        assert_eq!(comp.derive_progress(&degenerate, 0.5), 0.5);
    }

    #[test]
    fn remap_override_replaces_and_restores_document_track() {
        let mut pre = precomp(1, "pre", "a", 512.0, 512.0);
        pre.start_progress = 0.1;
        let mut doc = document(vec![pre]);
        doc.precomps
            .insert("a".to_owned(), vec![solid(2, "inner", RED)]);
        let mut tree = root(&doc);

        tree.set_progress(0.5);
        {
            let pre = paintable_child(&tree, 0);
            let inner = paintable_child(pre, 0);
            assert_eq!(pre.progress(), 0.5, "the layer keeps the handed-down progress");
            assert!(
                (inner.progress() - 0.4).abs() < 1e-6,
                "children get the offset-derived progress"
            );
        }

        // Override the precomp's remap: pin it to second 1 regardless of
        // progress.
        {
            let Body::Composition(c) = &mut tree.body else {
                panic!("root is a composition");
            };
            let pre_index = c.paintable[0];
            c.arena[pre_index]
                .set_value_override(PropertyOverride::TimeRemap(Some(Box::new(|_| 1.0))));
        }
        tree.set_progress(0.5);
        {
            let inner = paintable_child(paintable_child(&tree, 0), 0);
            let expected = 24.0 / 48.01;
            assert!((inner.progress() - expected).abs() < 1e-6);
        }

        // Clearing the override restores the offset derivation.
        {
            let Body::Composition(c) = &mut tree.body else {
                panic!("root is a composition");
            };
            let pre_index = c.paintable[0];
            c.arena[pre_index].set_value_override(PropertyOverride::TimeRemap(None));
        }
        tree.set_progress(0.5);
        let inner = paintable_child(paintable_child(&tree, 0), 0);
        assert!((inner.progress() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn set_progress_is_idempotent() {
        let mut moving = solid(1, "mover", RED);
        moving.transform.position = Animated::keyframes(vec![
            Keyframe::new(0.0, Vec2::ZERO),
            Keyframe::new(1.0, Vec2::new(100.0, 0.0)),
        ]);
        let doc = document(vec![moving]);
        let mut tree = root(&doc);

        tree.set_progress(0.4);
        let mut first = Recorder::new();
        tree.draw(&mut first, Affine::IDENTITY, 255, None, 0.0);

        tree.set_progress(0.4);
        let mut second = Recorder::new();
        tree.draw(&mut second, Affine::IDENTITY, 255, None, 0.0);

        assert_eq!(first.ops, second.ops);
    }

    #[test]
    fn matte_sources_advance_with_their_consumer() {
        let mut consumer = solid(2, "consumer", GREEN);
        consumer.matte_mode = MatteMode::Add;
        let doc = document(vec![solid(1, "source", RED), consumer]);
        let mut tree = root(&doc);
        tree.set_progress(0.3);
        let Body::Composition(c) = &tree.body else {
            panic!("root is a composition");
        };
        let consumer = &c.arena[c.paintable[0]];
        let source = &c.arena[consumer.base.matte.unwrap()];
        assert_eq!(source.progress(), 0.3);
    }

    #[test]
    fn bounds_with_no_children_are_the_declared_rect() {
        let doc = document(vec![]);
        let tree = root(&doc);
        assert_eq!(
            tree.bounds(Affine::IDENTITY, true),
            Rect::new(0.0, 0.0, 512.0, 512.0)
        );
        assert_eq!(
            tree.bounds(Affine::translate((10.0, 0.0)), true),
            Rect::new(10.0, 0.0, 522.0, 512.0)
        );
    }

    #[test]
    fn bounds_union_children_outside_declared_rect() {
        let doc = document(vec![at(solid(1, "far", RED), 600.0, 0.0)]);
        let tree = root(&doc);
        assert_eq!(
            tree.bounds(Affine::IDENTITY, true),
            Rect::new(0.0, 0.0, 700.0, 512.0)
        );
    }

    #[test]
    fn has_masks_only_counts_shape_layers() {
        let mut masked_shape = shape(1, "masked");
        masked_shape.mask_count = 1;
        let doc = document(vec![masked_shape]);
        assert!(root(&doc).has_masks());

        let mut masked_image = LayerModel::new(
            LayerId(1),
            "img",
            LayerKind::Image(ContentRef {
                id: ContentId(7),
                width: 64.0,
                height: 64.0,
            }),
        );
        masked_image.mask_count = 1;
        let doc = document(vec![masked_image]);
        assert!(!root(&doc).has_masks());
    }

    #[test]
    fn has_masks_recurses_into_nested_compositions() {
        let mut masked = shape(2, "masked");
        masked.mask_count = 1;
        let mut doc = document(vec![precomp(1, "pre", "a", 512.0, 512.0)]);
        doc.precomps.insert("a".to_owned(), vec![masked]);
        let tree = root(&doc);
        assert!(tree.has_masks());
        // Second query hits the memo and must agree.
        assert!(tree.has_masks());
    }

    #[test]
    fn has_matte_checks_one_level_only() {
        let mut consumer = solid(2, "consumer", GREEN);
        consumer.matte_mode = MatteMode::Add;
        let mut doc = document(vec![precomp(3, "pre", "a", 512.0, 512.0)]);
        doc.precomps
            .insert("a".to_owned(), vec![solid(1, "source", RED), consumer]);
        let tree = root(&doc);
        assert!(!tree.has_matte(), "nested mattes are the nested comp's business");
        assert!(paintable_child(&tree, 0).has_matte());
        assert!(!tree.has_matte(), "memo stays stable across queries");
    }

    fn resolved_keys(tree: &Layer, pattern: &[&str]) -> Vec<Vec<String>> {
        let pattern = KeyPath::new(pattern.iter().copied());
        let mut acc = Vec::new();
        tree.resolve_key_path(&pattern, 0, &mut acc, &KeyPath::default());
        acc.iter().map(|p| p.keys().to_vec()).collect()
    }

    #[test]
    fn key_paths_resolve_through_the_container() {
        let mut doc = document(vec![
            solid(1, "dot", RED),
            precomp(2, "group", "a", 512.0, 512.0),
        ]);
        doc.precomps
            .insert("a".to_owned(), vec![solid(3, "dot", GREEN)]);
        let tree = root(&doc);

        assert_eq!(resolved_keys(&tree, &["dot"]), vec![vec!["dot".to_owned()]]);
        assert_eq!(
            resolved_keys(&tree, &["group", "dot"]),
            vec![vec!["group".to_owned(), "dot".to_owned()]]
        );
        assert_eq!(
            resolved_keys(&tree, &["**", "dot"]),
            vec![
                vec!["dot".to_owned()],
                vec!["group".to_owned(), "dot".to_owned()],
            ],
            "globstar reaches both depths, document order first"
        );
    }

    #[test]
    fn key_path_wildcard_matches_one_level() {
        let mut doc = document(vec![precomp(1, "group", "a", 512.0, 512.0)]);
        doc.precomps
            .insert("a".to_owned(), vec![solid(2, "dot", GREEN)]);
        let tree = root(&doc);
        assert_eq!(
            resolved_keys(&tree, &["*", "dot"]),
            vec![vec!["group".to_owned(), "dot".to_owned()]]
        );
        assert!(resolved_keys(&tree, &["*"]).contains(&vec!["group".to_owned()]));
    }

    #[test]
    fn effect_overrides_on_layers_without_the_effect_are_inert() {
        let doc = document(vec![solid(1, "plain", RED)]);
        let mut tree = root(&doc);
        let Body::Composition(c) = &mut tree.body else {
            panic!("root is a composition");
        };
        let child = c.paintable[0];
        c.arena[child].set_value_override(PropertyOverride::DropShadowColor(Some(Box::new(
            |_| Color::WHITE,
        ))));
        c.arena[child].set_value_override(PropertyOverride::BlurRadius(Some(Box::new(|_| 9.0))));

        let mut rec = Recorder::new();
        tree.draw(&mut rec, Affine::IDENTITY, 255, None, 0.0);
        assert!(rec.begins().is_empty(), "no effect evaluators, no passes");
    }

    #[test]
    fn outline_flag_tints_masked_and_matted_layers() {
        let mut consumer = shape(2, "consumer");
        consumer.matte_mode = MatteMode::Add;
        let doc = document(vec![solid(1, "source", RED), consumer]);
        let mut tree = root(&doc);
        tree.set_outline_masks_and_mattes(true);
        let mut rec = Recorder::new();
        tree.draw(&mut rec, Affine::IDENTITY, 255, None, 0.0);
        assert!(
            rec.fills().contains(&(super::super::OUTLINE_TINT, 50)),
            "outlined matte consumer draws its debug tint"
        );

        tree.set_outline_masks_and_mattes(false);
        let mut rec = Recorder::new();
        tree.draw(&mut rec, Affine::IDENTITY, 255, None, 0.0);
        assert!(!rec.fills().contains(&(super::super::OUTLINE_TINT, 50)));
    }
}
