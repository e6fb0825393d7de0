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

//! The CPU pixel layouts understood by the software loops.

use super::{premultiply, unpremultiply};
use serde::{Deserialize, Serialize};

/// A CPU-side pixel layout.
///
/// 32-bit and 16-bit layouts are stored as native-endian integers; the
/// three-byte layout is stored as `B, G, R` bytes. The discriminant is the
/// format id carried in bits 16..31 of a blit record's packed parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u16)]
pub enum PixelFormat {
    /// `0xAARRGGBB`, straight alpha.
    IntArgb = 0,
    /// `0xAARRGGBB`, premultiplied alpha. The canonical intermediate format.
    IntArgbPre = 1,
    /// `0x00RRGGBB`.
    IntRgb = 2,
    /// `0xRRGGBBxx`.
    IntRgbx = 3,
    /// `0x00BBGGRR`.
    IntBgr = 4,
    /// `0xBBGGRRxx`.
    IntBgrx = 5,
    /// 5-6-5 RGB in a `u16`.
    Ushort565Rgb = 6,
    /// x-5-5-5 RGB in a `u16`.
    Ushort555Rgb = 7,
    /// 5-5-5-x RGB in a `u16`.
    Ushort555Rgbx = 8,
    /// 8-bit luminance.
    ByteGray = 9,
    /// 16-bit luminance.
    UshortGray = 10,
    /// Three bytes per pixel in `B, G, R` order.
    ThreeByteBgr = 11,
}

impl PixelFormat {
    /// The canonical premultiplied layout used for intermediates.
    pub const CANONICAL: PixelFormat = PixelFormat::IntArgbPre;

    /// Every supported format, ordered by id.
    pub const ALL: [PixelFormat; 12] = [
        PixelFormat::IntArgb,
        PixelFormat::IntArgbPre,
        PixelFormat::IntRgb,
        PixelFormat::IntRgbx,
        PixelFormat::IntBgr,
        PixelFormat::IntBgrx,
        PixelFormat::Ushort565Rgb,
        PixelFormat::Ushort555Rgb,
        PixelFormat::Ushort555Rgbx,
        PixelFormat::ByteGray,
        PixelFormat::UshortGray,
        PixelFormat::ThreeByteBgr,
    ];

    /// The id written into packed blit parameters.
    #[inline]
    pub const fn id(self) -> u16 {
        self as u16
    }

    /// Looks up a format by id.
    pub fn from_id(id: u16) -> Option<Self> {
        Self::ALL.get(id as usize).copied()
    }

    /// Bytes occupied by one pixel.
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::IntArgb
            | PixelFormat::IntArgbPre
            | PixelFormat::IntRgb
            | PixelFormat::IntRgbx
            | PixelFormat::IntBgr
            | PixelFormat::IntBgrx => 4,
            PixelFormat::Ushort565Rgb
            | PixelFormat::Ushort555Rgb
            | PixelFormat::Ushort555Rgbx
            | PixelFormat::UshortGray => 2,
            PixelFormat::ThreeByteBgr => 3,
            PixelFormat::ByteGray => 1,
        }
    }

    /// Returns `true` if the layout stores alpha.
    pub const fn has_alpha(self) -> bool {
        matches!(self, PixelFormat::IntArgb | PixelFormat::IntArgbPre)
    }

    /// Decodes one pixel into canonical premultiplied ARGB.
    ///
    /// `bytes` must hold at least [`PixelFormat::bytes_per_pixel`] bytes.
    pub fn load(self, bytes: &[u8]) -> u32 {
        match self {
            PixelFormat::IntArgb => premultiply(read_u32(bytes)),
            PixelFormat::IntArgbPre => read_u32(bytes),
            PixelFormat::IntRgb => 0xFF00_0000 | (read_u32(bytes) & 0x00FF_FFFF),
            PixelFormat::IntRgbx => 0xFF00_0000 | (read_u32(bytes) >> 8),
            PixelFormat::IntBgr => 0xFF00_0000 | swap_rb(read_u32(bytes) & 0x00FF_FFFF),
            PixelFormat::IntBgrx => 0xFF00_0000 | swap_rb(read_u32(bytes) >> 8),
            PixelFormat::Ushort565Rgb => {
                let p = read_u16(bytes) as u32;
                rgb(
                    expand5(p >> 11),
                    ((p >> 5) & 0x3F) << 2 | ((p >> 9) & 0x3),
                    expand5(p),
                )
            }
            PixelFormat::Ushort555Rgb => {
                let p = read_u16(bytes) as u32;
                rgb(expand5(p >> 10), expand5(p >> 5), expand5(p))
            }
            PixelFormat::Ushort555Rgbx => {
                let p = read_u16(bytes) as u32;
                rgb(expand5(p >> 11), expand5(p >> 6), expand5(p >> 1))
            }
            PixelFormat::ByteGray => {
                let g = bytes[0] as u32;
                rgb(g, g, g)
            }
            PixelFormat::UshortGray => {
                let g = (read_u16(bytes) >> 8) as u32;
                rgb(g, g, g)
            }
            PixelFormat::ThreeByteBgr => rgb(bytes[2] as u32, bytes[1] as u32, bytes[0] as u32),
        }
    }

    /// Encodes one canonical premultiplied ARGB pixel.
    ///
    /// Opaque layouts receive the straight colour with alpha dropped.
    pub fn store(self, bytes: &mut [u8], argb_pre: u32) {
        let argb = unpremultiply(argb_pre);
        let (r, g, b) = ((argb >> 16) & 0xFF, (argb >> 8) & 0xFF, argb & 0xFF);
        match self {
            PixelFormat::IntArgb => write_u32(bytes, argb),
            PixelFormat::IntArgbPre => write_u32(bytes, argb_pre),
            PixelFormat::IntRgb => write_u32(bytes, argb & 0x00FF_FFFF),
            PixelFormat::IntRgbx => write_u32(bytes, (argb & 0x00FF_FFFF) << 8),
            PixelFormat::IntBgr => write_u32(bytes, swap_rb(argb & 0x00FF_FFFF)),
            PixelFormat::IntBgrx => write_u32(bytes, swap_rb(argb & 0x00FF_FFFF) << 8),
            PixelFormat::Ushort565Rgb => {
                write_u16(bytes, ((r >> 3) << 11 | (g >> 2) << 5 | (b >> 3)) as u16)
            }
            PixelFormat::Ushort555Rgb => {
                write_u16(bytes, ((r >> 3) << 10 | (g >> 3) << 5 | (b >> 3)) as u16)
            }
            PixelFormat::Ushort555Rgbx => {
                write_u16(bytes, ((r >> 3) << 11 | (g >> 3) << 6 | (b >> 3) << 1) as u16)
            }
            PixelFormat::ByteGray => bytes[0] = luminance8(r, g, b) as u8,
            PixelFormat::UshortGray => write_u16(bytes, luminance16(r, g, b) as u16),
            PixelFormat::ThreeByteBgr => {
                bytes[0] = b as u8;
                bytes[1] = g as u8;
                bytes[2] = r as u8;
            }
        }
    }
}

#[inline]
fn read_u32(bytes: &[u8]) -> u32 {
    bytemuck::pod_read_unaligned(&bytes[..4])
}

#[inline]
fn read_u16(bytes: &[u8]) -> u16 {
    bytemuck::pod_read_unaligned(&bytes[..2])
}

#[inline]
fn write_u32(bytes: &mut [u8], v: u32) {
    bytes[..4].copy_from_slice(bytemuck::bytes_of(&v));
}

#[inline]
fn write_u16(bytes: &mut [u8], v: u16) {
    bytes[..2].copy_from_slice(bytemuck::bytes_of(&v));
}

#[inline]
const fn rgb(r: u32, g: u32, b: u32) -> u32 {
    0xFF00_0000 | (r << 16) | (g << 8) | b
}

#[inline]
const fn swap_rb(p: u32) -> u32 {
    ((p & 0xFF) << 16) | (p & 0xFF00) | ((p >> 16) & 0xFF)
}

#[inline]
const fn expand5(v: u32) -> u32 {
    let v = v & 0x1F;
    (v << 3) | (v >> 2)
}

#[inline]
const fn luminance8(r: u32, g: u32, b: u32) -> u32 {
    (77 * r + 150 * g + 29 * b + 128) >> 8
}

#[inline]
const fn luminance16(r: u32, g: u32, b: u32) -> u32 {
    (19672 * r + 38621 * g + 7500 * b) >> 8
}
