// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reverse-scan construction of a composition's child list.
//!
//! Models are visited bottommost first. Every constructible model joins
//! the arena. A model that declares a matte keeps painting but becomes
//! pending; the next layer constructed in scan order, which is the model
//! declared directly above it, is attached to it as the matte source
//! instead of joining the paintable list. A skipped model leaves a pending
//! matte waiting for the next constructible one.
//!
//! Parent links resolve by id after the scan, over all built layers
//! including matte sources. With duplicate ids the topmost declaration
//! wins. Ids that resolve nowhere are dropped with a trace event;
//! construction itself never fails.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::model::{Document, LayerId, LayerModel};
#[cfg(feature = "trace-rich")]
use crate::trace::LayerBuiltEvent;
use crate::trace::{
    LayerSkippedEvent, MatteAttachedEvent, ParentMissingEvent, ResolveSummary, Tracer,
};

use super::{Layer, RenderSettings};

/// Builds the arena and the paintable index list for one layer list.
pub(crate) fn build_list(
    models: &[LayerModel],
    document: &Document,
    settings: RenderSettings,
    tracer: &mut Tracer<'_>,
) -> (Vec<Layer>, Vec<usize>) {
    let mut arena: Vec<Layer> = Vec::with_capacity(models.len());
    let mut paintable: Vec<usize> = Vec::new();
    let mut by_id: BTreeMap<LayerId, usize> = BTreeMap::new();
    let mut pending_matte: Option<usize> = None;
    let mut summary = ResolveSummary {
        models: models.len(),
        ..ResolveSummary::default()
    };

    for model_index in (0..models.len()).rev() {
        let model = &models[model_index];
        let layer = match Layer::from_model(model, document, settings, tracer) {
            Ok(layer) => layer,
            Err(reason) => {
                summary.skipped += 1;
                tracer.layer_skipped(&LayerSkippedEvent {
                    model_index,
                    id: model.id,
                    reason,
                });
                continue;
            }
        };
        let index = arena.len();
        arena.push(layer);
        by_id.insert(model.id, index);

        match pending_matte.take() {
            Some(consumer) => {
                arena[consumer].base.matte = Some(index);
                summary.matted += 1;
                tracer.matte_attached(&MatteAttachedEvent {
                    consumer: arena[consumer].id(),
                    source: model.id,
                });
                #[cfg(feature = "trace-rich")]
                tracer.layer_built(&LayerBuiltEvent {
                    model_index,
                    id: model.id,
                    paintable: false,
                });
            }
            None => {
                paintable.push(index);
                if model.matte_mode.is_matte() {
                    pending_matte = Some(index);
                }
                #[cfg(feature = "trace-rich")]
                tracer.layer_built(&LayerBuiltEvent {
                    model_index,
                    id: model.id,
                    paintable: true,
                });
            }
        }
    }

    for index in 0..arena.len() {
        let Some(parent_id) = arena[index].base.model.parent else {
            continue;
        };
        match by_id.get(&parent_id) {
            Some(&parent) => arena[index].base.parent = Some(parent),
            None => {
                summary.missing_parents += 1;
                tracer.parent_missing(&ParentMissingEvent {
                    child: arena[index].id(),
                    parent: parent_id,
                });
            }
        }
    }

    summary.paintable = paintable.len();
    tracer.resolve_summary(&summary);
    (arena, paintable)
}
