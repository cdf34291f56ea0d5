// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A software implementation of the compositor's surface contract.
//!
//! [`RasterSurface`] renders into a [`tiny_skia::Pixmap`]. The mapping from
//! surface ops to pixels:
//!
//! - Clips stay axis-aligned device rectangles on a save stack and are
//!   rasterized into coverage [`Mask`]s at draw time.
//! - Offscreen passes allocate a scratch pixmap scoped to the pass rectangle
//!   (padded by the blur reach). Ending the pass blurs the scratch in place,
//!   stamps the drop shadow beneath it, and composites both onto the
//!   surrounding target with the pass's alpha and blend mode.
//! - Content ids resolve against pixmaps registered up front with
//!   [`RasterSurface::register_content`]; an unregistered id draws nothing.
//!
//! Coordinates arriving through the trait are already device-space, so the
//! surface forwards transforms to tiny-skia untouched.

use std::collections::HashMap;
use std::fmt;

use kurbo::{Affine, Rect};
use tiny_skia::{FillRule, FilterQuality, Mask, Paint, PathBuilder, Pixmap, PixmapPaint, Transform};

use lamina_core::effects::DropShadow;
use lamina_core::model::{Color, ContentId};
use lamina_core::surface::{BlendMode, ComposeOp, Surface};

use crate::blur;

/// One pending offscreen pass.
struct Frame {
    /// Scratch pixels, `None` when the pass rectangle was empty. A `None`
    /// buffer swallows every draw until the pass ends.
    buffer: Option<Pixmap>,
    /// Device position of the buffer's top-left pixel.
    origin: (i32, i32),
    /// Composite parameters captured at `begin_layer`.
    op: ComposeOp,
}

/// A CPU render target backed by a [`tiny_skia::Pixmap`].
pub struct RasterSurface {
    base: Pixmap,
    contents: HashMap<ContentId, Pixmap>,
    /// Clip stack, innermost last; `None` is unclipped. Never empty.
    clips: Vec<Option<Rect>>,
    frames: Vec<Frame>,
}

impl RasterSurface {
    /// Creates a transparent surface of the given pixel size.
    ///
    /// Returns `None` when either dimension is zero or the allocation is
    /// refused.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Option<Self> {
        Some(Self {
            base: Pixmap::new(width, height)?,
            contents: HashMap::new(),
            clips: vec![None],
            frames: Vec::new(),
        })
    }

    /// Registers the pixels a content id resolves to, replacing any previous
    /// registration.
    pub fn register_content(&mut self, id: ContentId, pixels: Pixmap) {
        self.contents.insert(id, pixels);
    }

    /// Fills the whole surface with `color`, discarding previous output.
    pub fn clear(&mut self, color: Color) {
        self.base
            .fill(tiny_skia::Color::from_rgba8(color.r, color.g, color.b, color.a));
    }

    /// The rendered pixels.
    #[must_use]
    pub fn pixmap(&self) -> &Pixmap {
        &self.base
    }

    /// Consumes the surface, returning the rendered pixels.
    #[must_use]
    pub fn into_pixmap(self) -> Pixmap {
        self.base
    }

    fn current_clip(&self) -> Option<Rect> {
        self.clips.last().copied().flatten()
    }

    /// Device rectangle of the pixmap draws currently land in, or `None`
    /// while the innermost pass has no buffer.
    fn device_rect(&self) -> Option<Rect> {
        match self.frames.last() {
            Some(Frame {
                buffer: Some(buffer),
                origin,
                ..
            }) => Some(Rect::new(
                f64::from(origin.0),
                f64::from(origin.1),
                f64::from(origin.0) + f64::from(buffer.width()),
                f64::from(origin.1) + f64::from(buffer.height()),
            )),
            Some(_) => None,
            None => Some(Rect::new(
                0.0,
                0.0,
                f64::from(self.base.width()),
                f64::from(self.base.height()),
            )),
        }
    }
}

impl Surface for RasterSurface {
    fn save(&mut self) {
        self.clips.push(self.current_clip());
    }

    fn restore(&mut self) {
        // The bottom entry is the surface's own unclipped state and stays.
        if self.clips.len() > 1 {
            self.clips.pop();
        }
    }

    fn clip_rect(&mut self, rect: Rect) -> bool {
        let merged = match self.current_clip() {
            Some(clip) => clip.intersect(rect),
            None => rect,
        };
        if let Some(top) = self.clips.last_mut() {
            *top = Some(merged);
        }
        merged.width() > 0.0 && merged.height() > 0.0
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "device coordinates fit f32 comfortably"
    )]
    fn fill_rect(&mut self, rect: Rect, transform: Affine, color: Color, alpha: u8) {
        let Some(shape) = tiny_skia::Rect::from_ltrb(
            rect.x0 as f32,
            rect.y0 as f32,
            rect.x1 as f32,
            rect.y1 as f32,
        ) else {
            return;
        };
        let path = PathBuilder::from_rect(shape);
        let mut paint = Paint::default();
        paint.set_color_rgba8(color.r, color.g, color.b, mul_alpha(color.a, alpha));
        paint.anti_alias = true;

        let clip = self.current_clip();
        let Some((target, origin)) = active_target(&mut self.frames, &mut self.base) else {
            return;
        };
        let to_local =
            to_transform(transform).post_translate(-(origin.0 as f32), -(origin.1 as f32));
        let mask = clip_mask(clip, target.width(), target.height(), origin);
        target.fill_path(&path, &paint, FillRule::Winding, to_local, mask.as_ref());
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "device coordinates fit f32 comfortably"
    )]
    fn draw_content(&mut self, content: ContentId, bounds: Rect, transform: Affine, alpha: u8) {
        let Some(pixels) = self.contents.get(&content) else {
            return;
        };
        if bounds.width() <= 0.0 || bounds.height() <= 0.0 {
            return;
        }

        let clip = self.current_clip();
        let Some((target, origin)) = active_target(&mut self.frames, &mut self.base) else {
            return;
        };
        // Scale the registered pixels into the declared content rectangle,
        // then hand the rest of the mapping to the layer transform.
        let sx = (bounds.width() / f64::from(pixels.width())) as f32;
        let sy = (bounds.height() / f64::from(pixels.height())) as f32;
        let to_local = to_transform(transform)
            .pre_translate(bounds.x0 as f32, bounds.y0 as f32)
            .pre_scale(sx, sy)
            .post_translate(-(origin.0 as f32), -(origin.1 as f32));
        let paint = PixmapPaint {
            opacity: f32::from(alpha) / 255.0,
            blend_mode: tiny_skia::BlendMode::SourceOver,
            quality: FilterQuality::Bilinear,
        };
        let mask = clip_mask(clip, target.width(), target.height(), origin);
        target.draw_pixmap(0, 0, pixels.as_ref(), &paint, to_local, mask.as_ref());
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "the pass rectangle is clamped to the target before the casts"
    )]
    fn begin_layer(&mut self, bounds: Rect, op: &ComposeOp) {
        let mut buffer = None;
        let mut origin = (0, 0);
        if let Some(device) = self.device_rect() {
            let mut region = bounds.intersect(device);
            if let Some(clip) = self.current_clip() {
                region = region.intersect(clip);
            }
            if region.width() > 0.0 && region.height() > 0.0 {
                // Pad by the blur reach so energy can spread past the pass
                // rectangle and still land on visible pixels.
                let pad = op.blur.max(0.0).ceil() as i32;
                let x0 = region.x0.floor() as i32 - pad;
                let y0 = region.y0.floor() as i32 - pad;
                let x1 = region.x1.ceil() as i32 + pad;
                let y1 = region.y1.ceil() as i32 + pad;
                buffer = Pixmap::new((x1 - x0) as u32, (y1 - y0) as u32);
                origin = (x0, y0);
            }
        }
        self.frames.push(Frame {
            buffer,
            origin,
            op: op.clone(),
        });
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "shadow offsets are small device distances"
    )]
    fn end_layer(&mut self) {
        let Some(frame) = self.frames.pop() else {
            return;
        };
        let Frame { buffer, origin, op } = frame;
        let Some(mut buffer) = buffer else {
            return;
        };

        if op.blur > 0.0 {
            let (w, h) = (buffer.width(), buffer.height());
            blur::blur_premul_rgba8(buffer.data_mut(), w, h, op.blur);
        }

        let opacity = f32::from(op.alpha) / 255.0;
        let clip = self.current_clip();
        let Some((target, target_origin)) = active_target(&mut self.frames, &mut self.base) else {
            return;
        };
        let mask = clip_mask(clip, target.width(), target.height(), target_origin);

        if let Some(shadow) = op.shadow
            && let Some((stamp, pad)) = shadow_stamp(&buffer, &shadow)
        {
            let paint = PixmapPaint {
                opacity,
                blend_mode: tiny_skia::BlendMode::SourceOver,
                quality: FilterQuality::Nearest,
            };
            let x = origin.0 - target_origin.0 - pad + shadow.offset.x.round() as i32;
            let y = origin.1 - target_origin.1 - pad + shadow.offset.y.round() as i32;
            target.draw_pixmap(x, y, stamp.as_ref(), &paint, Transform::identity(), mask.as_ref());
        }

        let paint = PixmapPaint {
            opacity,
            blend_mode: to_blend(op.blend),
            quality: FilterQuality::Nearest,
        };
        target.draw_pixmap(
            origin.0 - target_origin.0,
            origin.1 - target_origin.1,
            buffer.as_ref(),
            &paint,
            Transform::identity(),
            mask.as_ref(),
        );
    }
}

impl fmt::Debug for RasterSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RasterSurface")
            .field("width", &self.base.width())
            .field("height", &self.base.height())
            .field("contents", &self.contents.len())
            .field("clip_depth", &self.clips.len())
            .field("pending_passes", &self.frames.len())
            .finish_non_exhaustive()
    }
}

/// Resolves where draws currently land: the innermost pass buffer, or the
/// base pixmap when no pass is open. `None` while the innermost pass has no
/// buffer.
fn active_target<'a>(
    frames: &'a mut [Frame],
    base: &'a mut Pixmap,
) -> Option<(&'a mut Pixmap, (i32, i32))> {
    match frames.last_mut() {
        Some(Frame {
            buffer: Some(buffer),
            origin,
            ..
        }) => Some((buffer, *origin)),
        Some(_) => None,
        None => Some((base, (0, 0))),
    }
}

/// Rasterizes the active clip as a coverage mask sized to the target.
///
/// `None` means unclipped. A clip that misses the target entirely yields an
/// all-zero mask, which blocks every draw.
#[expect(
    clippy::cast_possible_truncation,
    reason = "device coordinates fit f32 comfortably"
)]
fn clip_mask(clip: Option<Rect>, width: u32, height: u32, origin: (i32, i32)) -> Option<Mask> {
    let clip = clip?;
    let mut mask = Mask::new(width, height)?;
    if let Some(local) = tiny_skia::Rect::from_ltrb(
        (clip.x0 - f64::from(origin.0)) as f32,
        (clip.y0 - f64::from(origin.1)) as f32,
        (clip.x1 - f64::from(origin.0)) as f32,
        (clip.y1 - f64::from(origin.1)) as f32,
    ) {
        mask.fill_path(
            &PathBuilder::from_rect(local),
            FillRule::Winding,
            false,
            Transform::identity(),
        );
    }
    Some(mask)
}

/// Builds the blurred shadow for a pass buffer: the buffer's alpha tinted
/// with the shadow color, padded by the softness reach, blurred.
///
/// Returns the stamp and the padding applied on each side.
#[expect(
    clippy::cast_possible_truncation,
    reason = "the softness radius is a small non-negative pixel count"
)]
fn shadow_stamp(source: &Pixmap, shadow: &DropShadow) -> Option<(Pixmap, i32)> {
    let pad = shadow.radius.max(0.0).ceil() as i32;
    let width = source.width() + 2 * pad as u32;
    let height = source.height() + 2 * pad as u32;
    let mut stamp = Pixmap::new(width, height)?;

    {
        let src = source.data();
        let dst = stamp.data_mut();
        let src_w = source.width() as usize;
        let dst_w = width as usize;
        let margin = pad as usize;
        for y in 0..source.height() as usize {
            for x in 0..src_w {
                let coverage = src[(y * src_w + x) * 4 + 3];
                if coverage == 0 {
                    continue;
                }
                let alpha = mul_alpha(shadow.color.a, coverage);
                let at = ((y + margin) * dst_w + x + margin) * 4;
                dst[at] = mul_alpha(shadow.color.r, alpha);
                dst[at + 1] = mul_alpha(shadow.color.g, alpha);
                dst[at + 2] = mul_alpha(shadow.color.b, alpha);
                dst[at + 3] = alpha;
            }
        }
    }
    blur::blur_premul_rgba8(stamp.data_mut(), width, height, shadow.radius);
    Some((stamp, pad))
}

fn to_blend(blend: BlendMode) -> tiny_skia::BlendMode {
    match blend {
        BlendMode::SrcOver => tiny_skia::BlendMode::SourceOver,
        BlendMode::DestIn => tiny_skia::BlendMode::DestinationIn,
        BlendMode::DestOut => tiny_skia::BlendMode::DestinationOut,
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "device coordinates fit f32 comfortably"
)]
fn to_transform(affine: Affine) -> Transform {
    let [a, b, c, d, e, f] = affine.as_coeffs();
    Transform::from_row(a as f32, b as f32, c as f32, d as f32, e as f32, f as f32)
}

/// Multiplies two 8-bit alphas, rounding to nearest.
#[expect(
    clippy::cast_possible_truncation,
    reason = "a product of two u8 divided by 255 fits u8"
)]
fn mul_alpha(a: u8, b: u8) -> u8 {
    ((u16::from(a) * u16::from(b) + 127) / 255) as u8
}
