// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Renders a hand-built scene exercising the compositor end to end: a matte
//! reveal, a layer orbiting a parented null, and a shadowed, slightly
//! blurred precomposition, written as one PNG per sampled frame.
//!
//! Usage: `shadow_scene [out_dir]` (default: current directory).
//! Construction diagnostics print to stderr.

use std::path::PathBuf;

use anyhow::{Context, Result};
use kurbo::{Affine, Vec2};

use lamina_core::animated::{Animated, Keyframe};
use lamina_core::layer::{Layer, RenderSettings};
use lamina_core::model::{
    BlurEffect, Color, Document, DropShadowEffect, LayerId, LayerKind, LayerModel, MatteMode,
};
use lamina_core::trace::Tracer;
use lamina_debug::pretty::PrettyPrintSink;
use lamina_raster::surface::RasterSurface;

const SIZE: u32 = 512;
const FRAMES: [u32; 4] = [0, 12, 24, 36];

fn main() -> Result<()> {
    let out_dir = PathBuf::from(std::env::args().nth(1).unwrap_or_else(|| ".".into()));
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("failed creating {}", out_dir.display()))?;

    let document = build_document();
    let mut sink = PrettyPrintSink::stderr();
    let mut tracer = Tracer::new(&mut sink);
    let mut root = Layer::from_document_traced(&document, RenderSettings::default(), &mut tracer);

    for frame in FRAMES {
        #[expect(clippy::cast_precision_loss, reason = "frame numbers are tiny")]
        let progress = frame as f32 / document.duration_frames();
        root.set_progress(progress);

        let mut surface = RasterSurface::new(SIZE, SIZE).context("surface allocation failed")?;
        root.draw(&mut surface, Affine::IDENTITY, 255, None, 0.0);

        let path = out_dir.join(format!("shadow_scene_{frame:03}.png"));
        surface
            .pixmap()
            .save_png(&path)
            .with_context(|| format!("failed writing {}", path.display()))?;
        println!("wrote {}", path.display());
    }
    Ok(())
}

/// A 512x512 scene over 48 frames at 24 fps.
///
/// Stacking order, topmost first: the matte source sweeping over an amber
/// banner, a coral orbiter parented to a spinning null at canvas center, a
/// shadowed two-layer card precomp, and a navy backdrop.
fn build_document() -> Document {
    let mut document = Document::new(512.0, 512.0, 24.0, 0.0, 48.0);

    let mut spot = LayerModel::new(
        LayerId(1),
        "spot",
        LayerKind::Solid {
            color: Color::WHITE,
            width: 140.0,
            height: 96.0,
        },
    );
    spot.transform.position = Animated::keyframes(vec![
        Keyframe::new(0.0, Vec2::new(-20.0, 330.0)),
        Keyframe::new(1.0, Vec2::new(392.0, 330.0)),
    ]);

    let mut banner = LayerModel::new(
        LayerId(2),
        "banner",
        LayerKind::Solid {
            color: Color::rgb8(255, 179, 64),
            width: 512.0,
            height: 96.0,
        },
    );
    banner.matte_mode = MatteMode::Add;
    banner.transform.position = Animated::constant(Vec2::new(0.0, 330.0));
    banner.opacity = Animated::constant(0.9);

    let mut orbiter = LayerModel::new(
        LayerId(3),
        "orbiter",
        LayerKind::Solid {
            color: Color::rgb8(255, 99, 88),
            width: 36.0,
            height: 36.0,
        },
    );
    orbiter.parent = Some(LayerId(4));
    orbiter.transform.anchor = Vec2::new(18.0, 18.0);
    orbiter.transform.position = Animated::constant(Vec2::new(170.0, 0.0));

    let mut rig = LayerModel::new(LayerId(4), "rig", LayerKind::Null);
    rig.transform.position = Animated::constant(Vec2::new(256.0, 220.0));
    rig.transform.rotation =
        Animated::keyframes(vec![Keyframe::new(0.0, 0.0), Keyframe::new(1.0, 360.0)]);

    let mut card = LayerModel::new(
        LayerId(5),
        "card",
        LayerKind::Precomp {
            asset: "card".into(),
        },
    );
    card.precomp_width = 200.0;
    card.precomp_height = 140.0;
    card.transform.position = Animated::constant(Vec2::new(156.0, 150.0));
    card.drop_shadow = Some(DropShadowEffect {
        color: Animated::constant(Color::BLACK),
        opacity: Animated::constant(0.6),
        direction: Animated::constant(45.0),
        distance: Animated::constant(12.0),
        radius: Animated::constant(8.0),
    });
    card.blur = Some(BlurEffect {
        radius: Animated::constant(1.5),
    });

    let backdrop = LayerModel::new(
        LayerId(6),
        "backdrop",
        LayerKind::Solid {
            color: Color::rgb8(18, 22, 38),
            width: 512.0,
            height: 512.0,
        },
    );

    document.layers = vec![spot, banner, orbiter, rig, card, backdrop];
    document.precomps.insert(
        "card".into(),
        vec![
            LayerModel::new(
                LayerId(1),
                "stripe",
                LayerKind::Solid {
                    color: Color::rgb8(64, 120, 255),
                    width: 200.0,
                    height: 28.0,
                },
            ),
            LayerModel::new(
                LayerId(2),
                "face",
                LayerKind::Solid {
                    color: Color::rgb8(238, 240, 245),
                    width: 200.0,
                    height: 140.0,
                },
            ),
        ],
    );
    document
}
