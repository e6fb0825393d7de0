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

//! Pixel formats, CPU pixel storage and the software compositing loops shared
//! by the pipeline and the reference driver.
//!
//! Every format converts to and from the canonical layout: 32-bit
//! premultiplied ARGB held in a `u32` (`0xAARRGGBB`).

pub mod blend;
mod buffer;
mod format;
mod image;

pub use buffer::PixelBuffer;
pub use format::PixelFormat;
pub use image::CpuImage;

/// Multiplies two 8-bit fractions with rounding (`a * b / 255`).
#[inline]
pub const fn mul8(a: u32, b: u32) -> u32 {
    let t = a * b + 0x80;
    (t + (t >> 8)) >> 8
}

/// Divides an 8-bit component by an 8-bit alpha with rounding, saturating at 255.
#[inline]
pub const fn div8(v: u32, a: u32) -> u32 {
    if a == 0 {
        0
    } else {
        let r = (v * 255 + a / 2) / a;
        if r > 255 {
            255
        } else {
            r
        }
    }
}

/// Converts a non-premultiplied ARGB pixel to premultiplied form.
#[inline]
pub const fn premultiply(argb: u32) -> u32 {
    let a = argb >> 24;
    if a == 0xFF {
        return argb;
    }
    let r = mul8((argb >> 16) & 0xFF, a);
    let g = mul8((argb >> 8) & 0xFF, a);
    let b = mul8(argb & 0xFF, a);
    (a << 24) | (r << 16) | (g << 8) | b
}

/// Converts a premultiplied ARGB pixel back to non-premultiplied form.
#[inline]
pub const fn unpremultiply(argb_pre: u32) -> u32 {
    let a = argb_pre >> 24;
    if a == 0xFF {
        return argb_pre;
    }
    if a == 0 {
        return 0;
    }
    let r = div8((argb_pre >> 16) & 0xFF, a);
    let g = div8((argb_pre >> 8) & 0xFF, a);
    let b = div8(argb_pre & 0xFF, a);
    (a << 24) | (r << 16) | (g << 8) | b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mul8_is_exact_at_the_ends() {
        for v in 0..=255 {
            assert_eq!(mul8(v, 255), v);
            assert_eq!(mul8(v, 0), 0);
        }
        assert_eq!(mul8(128, 128), 64);
    }

    #[test]
    fn premultiply_round_trips_opaque_and_clear() {
        assert_eq!(premultiply(0xFF12_3456), 0xFF12_3456);
        assert_eq!(unpremultiply(0x0012_3456), 0);
        assert_eq!(unpremultiply(premultiply(0x80FF_0000)), 0x80FF_0000);
    }
}
