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

//! Half-open integer rectangles in device space.

/// An axis-aligned rectangle with inclusive low and exclusive high edges.
///
/// A rectangle whose high edge is not strictly greater than its low edge on
/// either axis is empty. All arithmetic saturates so that clip bounds near the
/// `i32` limits never wrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    /// The left edge (inclusive).
    pub x1: i32,
    /// The top edge (inclusive).
    pub y1: i32,
    /// The right edge (exclusive).
    pub x2: i32,
    /// The bottom edge (exclusive).
    pub y2: i32,
}

impl Rect {
    /// The canonical empty rectangle.
    pub const EMPTY: Self = Self::new(0, 0, 0, 0);

    /// A rectangle covering the whole representable device space.
    pub const INFINITE: Self = Self::new(i32::MIN, i32::MIN, i32::MAX, i32::MAX);

    /// Creates a rectangle from its edges.
    #[inline]
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Creates a rectangle from an origin and a size.
    #[inline]
    pub fn from_xywh(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self::new(x, y, x.saturating_add(width), y.saturating_add(height))
    }

    /// Creates the smallest integer rectangle covering the given floating-point bounds.
    pub fn covering(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        fn clamp(v: f64) -> i32 {
            if v.is_nan() {
                0
            } else {
                v.clamp(i32::MIN as f64, i32::MAX as f64) as i32
            }
        }
        Self::new(
            clamp(x1.floor()),
            clamp(y1.floor()),
            clamp(x2.ceil()),
            clamp(y2.ceil()),
        )
    }

    /// Returns the width, or zero for an empty rectangle.
    #[inline]
    pub fn width(&self) -> i32 {
        if self.x2 > self.x1 {
            self.x2.saturating_sub(self.x1)
        } else {
            0
        }
    }

    /// Returns the height, or zero for an empty rectangle.
    #[inline]
    pub fn height(&self) -> i32 {
        if self.y2 > self.y1 {
            self.y2.saturating_sub(self.y1)
        } else {
            0
        }
    }

    /// Returns `true` if the rectangle covers no pixel.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x2 <= self.x1 || self.y2 <= self.y1
    }

    /// Returns the overlap of two rectangles. The result may be empty.
    #[inline]
    pub fn intersect(&self, other: &Rect) -> Rect {
        Rect::new(
            self.x1.max(other.x1),
            self.y1.max(other.y1),
            self.x2.min(other.x2),
            self.y2.min(other.y2),
        )
    }

    /// Returns the rectangle moved by `(dx, dy)`.
    #[inline]
    pub fn translate(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(
            self.x1.saturating_add(dx),
            self.y1.saturating_add(dy),
            self.x2.saturating_add(dx),
            self.y2.saturating_add(dy),
        )
    }

    /// Returns `true` if the pixel at `(x, y)` lies inside the rectangle.
    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x1 && x < self.x2 && y >= self.y1 && y < self.y2
    }

    /// Returns `true` if `other` lies entirely inside this rectangle.
    /// An empty `other` is contained in every rectangle.
    #[inline]
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.is_empty()
            || (other.x1 >= self.x1
                && other.y1 >= self.y1
                && other.x2 <= self.x2
                && other.y2 <= self.y2)
    }
}
