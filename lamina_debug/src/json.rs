// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! JSON export for recorded op streams.
//!
//! [`export`] writes the ops captured by a
//! [`RecordingSurface`](crate::record::RecordingSurface) as a JSON array,
//! one object per op. The format is stable enough to diff two frames or
//! feed external inspection tooling.

use std::io::{self, Write};

use serde_json::{Value, json};

use kurbo::{Affine, Rect};

use lamina_core::model::Color;
use lamina_core::surface::{BlendMode, ComposeOp};

use crate::record::SurfaceOp;

/// Exports a recorded op stream as pretty-printed JSON.
pub fn export(ops: &[SurfaceOp], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();

    for op in ops {
        events.push(match op {
            SurfaceOp::Save => json!({ "op": "save" }),
            SurfaceOp::Restore => json!({ "op": "restore" }),
            SurfaceOp::ClipRect { rect, visible } => json!({
                "op": "clip-rect",
                "rect": rect_json(*rect),
                "visible": visible,
            }),
            SurfaceOp::FillRect {
                rect,
                transform,
                color,
                alpha,
            } => json!({
                "op": "fill-rect",
                "rect": rect_json(*rect),
                "transform": transform_json(*transform),
                "color": color_json(*color),
                "alpha": alpha,
            }),
            SurfaceOp::DrawContent {
                content,
                bounds,
                transform,
                alpha,
            } => json!({
                "op": "draw-content",
                "content": content.0,
                "bounds": rect_json(*bounds),
                "transform": transform_json(*transform),
                "alpha": alpha,
            }),
            SurfaceOp::BeginLayer { bounds, op } => json!({
                "op": "begin-layer",
                "bounds": rect_json(*bounds),
                "compose": compose_json(op),
            }),
            SurfaceOp::EndLayer => json!({ "op": "end-layer" }),
        });
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn rect_json(rect: Rect) -> Value {
    json!([rect.x0, rect.y0, rect.x1, rect.y1])
}

fn transform_json(transform: Affine) -> Value {
    json!(transform.as_coeffs())
}

fn color_json(color: Color) -> Value {
    json!(format!(
        "#{:02x}{:02x}{:02x}{:02x}",
        color.r, color.g, color.b, color.a
    ))
}

fn blend_name(blend: BlendMode) -> &'static str {
    match blend {
        BlendMode::SrcOver => "src-over",
        BlendMode::DestIn => "dest-in",
        BlendMode::DestOut => "dest-out",
    }
}

fn compose_json(op: &ComposeOp) -> Value {
    let shadow = match &op.shadow {
        Some(s) => json!({
            "color": color_json(s.color),
            "offset": [s.offset.x, s.offset.y],
            "radius": s.radius,
        }),
        None => Value::Null,
    };
    json!({
        "alpha": op.alpha,
        "blend": blend_name(op.blend),
        "shadow": shadow,
        "blur": op.blur,
    })
}
