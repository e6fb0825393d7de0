// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Software compositing of canonical pixels.
//!
//! These loops back every CPU-side path: CPU-to-CPU blits, the
//! composite-incapable fallback and the reference driver. Sampling is
//! nearest-neighbour at pixel centres; interpolation hints are accepted by
//! callers but have no effect here.

use super::{mul8, PixelBuffer};
use crate::composite::{Composite, CompositeRule};
use crate::math::{AffineTransform, Rect};
use crate::region::ClipRegion;

/// Combines one canonical source pixel with one canonical destination pixel.
#[inline]
pub fn composite_pixel(composite: &Composite, src: u32, dst: u32) -> u32 {
    match *composite {
        Composite::Alpha { rule, .. } => {
            let ea = composite.extra_alpha_u8() as u32;
            let s = if ea == 0xFF { src } else { scale(src, ea) };
            match rule {
                CompositeRule::Clear => 0,
                CompositeRule::Src => s,
                CompositeRule::SrcOver => {
                    let inv = 0xFF - (s >> 24);
                    if inv == 0 {
                        s
                    } else if inv == 0xFF {
                        dst
                    } else {
                        add(s, scale(dst, inv))
                    }
                }
            }
        }
        Composite::Xor { xor_pixel } => {
            if src >> 24 >= 0x80 {
                dst ^ ((src ^ xor_pixel) & 0x00FF_FFFF)
            } else {
                dst
            }
        }
    }
}

#[inline]
fn scale(p: u32, f: u32) -> u32 {
    (mul8(p >> 24, f) << 24)
        | (mul8((p >> 16) & 0xFF, f) << 16)
        | (mul8((p >> 8) & 0xFF, f) << 8)
        | mul8(p & 0xFF, f)
}

#[inline]
fn add(a: u32, b: u32) -> u32 {
    let ch = |shift: u32| (((a >> shift) & 0xFF) + ((b >> shift) & 0xFF)).min(0xFF) << shift;
    ch(24) | ch(16) | ch(8) | ch(0)
}

/// Draws `src_rect` of `src` into `dst` through `to_device`, which maps source
/// pixel space into destination device space.
///
/// Only destination pixels inside both `clip` and the destination bounds are
/// touched, and only if their centre maps back inside `src_rect`.
///
/// ## Returns
/// The number of destination pixels written.
pub fn draw_mapped(
    src: &PixelBuffer,
    src_rect: Rect,
    dst: &mut PixelBuffer,
    to_device: &AffineTransform,
    clip: &ClipRegion,
    composite: &Composite,
) -> usize {
    let Some(inverse) = to_device.inverse() else {
        return 0;
    };
    let src_rect = src_rect.intersect(&src.bounds());
    if src_rect.is_empty() {
        return 0;
    }
    let (x1, y1, x2, y2) = to_device.transform_bounds(
        src_rect.x1 as f64,
        src_rect.y1 as f64,
        src_rect.x2 as f64,
        src_rect.y2 as f64,
    );
    let area = Rect::covering(x1, y1, x2, y2).intersect(&dst.bounds());
    let clip = clip.intersect_rect(&area);

    let mut written = 0;
    for span in clip.spans() {
        for y in span.y1..span.y2 {
            for x in span.x1..span.x2 {
                let (sx, sy) = inverse.transform_point(x as f64 + 0.5, y as f64 + 0.5);
                let (sx, sy) = (sx.floor(), sy.floor());
                if sx < src_rect.x1 as f64
                    || sy < src_rect.y1 as f64
                    || sx >= src_rect.x2 as f64
                    || sy >= src_rect.y2 as f64
                {
                    continue;
                }
                let s = src.get(sx as u32, sy as u32);
                let d = dst.get(x as u32, y as u32);
                dst.set(x as u32, y as u32, composite_pixel(composite, s, d));
                written += 1;
            }
        }
    }
    written
}

/// Fills the part of `rect` inside `clip` with a canonical colour under `composite`.
pub fn fill_rect(
    dst: &mut PixelBuffer,
    rect: Rect,
    clip: &ClipRegion,
    composite: &Composite,
    argb_pre: u32,
) -> usize {
    let clip = clip.intersect_rect(&rect.intersect(&dst.bounds()));
    let mut written = 0;
    for span in clip.spans() {
        for y in span.y1..span.y2 {
            for x in span.x1..span.x2 {
                let d = dst.get(x as u32, y as u32);
                dst.set(x as u32, y as u32, composite_pixel(composite, argb_pre, d));
                written += 1;
            }
        }
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel::PixelFormat;

    #[test]
    fn src_over_blends_half_transparent_red_onto_blue() {
        let out = composite_pixel(&Composite::SRC_OVER, 0x8080_0000, 0xFF00_00FF);
        assert_eq!(out, 0xFF80_007F);
    }

    #[test]
    fn extra_alpha_scales_the_source() {
        let c = Composite::alpha(CompositeRule::Src, 0.5);
        assert_eq!(composite_pixel(&c, 0xFFFF_FFFF, 0), 0x8080_8080);
        let clear = Composite::alpha(CompositeRule::Clear, 1.0);
        assert_eq!(composite_pixel(&clear, 0xFFFF_FFFF, 0xFF12_3456), 0);
    }

    #[test]
    fn xor_flips_only_under_opaque_source() {
        let x = Composite::xor(0x00FF_FFFF);
        assert_eq!(composite_pixel(&x, 0xFF00_0000, 0xFF00_0000), 0xFFFF_FFFF);
        assert_eq!(composite_pixel(&x, 0x4000_0000, 0xFF00_0000), 0xFF00_0000);
    }

    #[test]
    fn translated_copy_respects_clip() {
        let src = PixelBuffer::solid(PixelFormat::IntArgbPre, 4, 4, 0xFFFF_0000);
        let mut dst = PixelBuffer::new(PixelFormat::IntRgb, 8, 8);
        let clip = ClipRegion::from_spans([Rect::new(0, 0, 8, 3), Rect::new(0, 3, 3, 8)]);
        let n = draw_mapped(
            &src,
            src.bounds(),
            &mut dst,
            &AffineTransform::translation(2.0, 2.0),
            &clip,
            &Composite::SRC,
        );
        // Rows 2..3 span x 2..6 (4 px); rows 3..6 span x 2..3 (3 px).
        assert_eq!(n, 4 + 3);
        assert_eq!(dst.get(5, 2), 0xFFFF_0000);
        assert_eq!(dst.get(5, 4), 0xFF00_0000);
    }

    #[test]
    fn scaling_replicates_pixels() {
        let src = PixelBuffer::from_argb_pre(2, 1, &[0xFF00_00FF, 0xFF00_FF00]);
        let mut dst = PixelBuffer::new(PixelFormat::IntArgbPre, 4, 2);
        let t = AffineTransform::rect_to_rect(0.0, 0.0, 2.0, 1.0, 0.0, 0.0, 4.0, 2.0);
        let n = draw_mapped(&src, src.bounds(), &mut dst, &t, &ClipRegion::unbounded(), &Composite::SRC);
        assert_eq!(n, 8);
        assert_eq!(dst.to_argb_pre(), vec![
            0xFF00_00FF, 0xFF00_00FF, 0xFF00_FF00, 0xFF00_FF00,
            0xFF00_00FF, 0xFF00_00FF, 0xFF00_FF00, 0xFF00_FF00,
        ]);
    }

    #[test]
    fn fill_is_clipped() {
        let mut dst = PixelBuffer::new(PixelFormat::IntArgbPre, 4, 4);
        let n = fill_rect(
            &mut dst,
            Rect::new(-2, -2, 2, 2),
            &ClipRegion::unbounded(),
            &Composite::SRC,
            0xFF00_FF00,
        );
        assert_eq!(n, 4);
        assert_eq!(dst.get(1, 1), 0xFF00_FF00);
        assert_eq!(dst.get(2, 2), 0);
    }
}
