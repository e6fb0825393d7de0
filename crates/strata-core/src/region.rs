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

//! Device-space clip regions.

use crate::math::Rect;
use std::sync::Arc;

/// A clip region: a bounding rectangle, optionally refined by a list of
/// disjoint span rectangles.
///
/// A region with no spans is exactly its bounds. Regions are normalized on
/// construction so that a span list collapsing to a single rectangle is stored
/// as a plain rectangular region.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClipRegion {
    bounds: Rect,
    spans: Option<Arc<[Rect]>>,
}

impl ClipRegion {
    /// Creates a rectangular region.
    pub fn rect(bounds: Rect) -> Self {
        let bounds = if bounds.is_empty() { Rect::EMPTY } else { bounds };
        Self {
            bounds,
            spans: None,
        }
    }

    /// A region covering the whole device space.
    pub fn unbounded() -> Self {
        Self::rect(Rect::INFINITE)
    }

    /// Creates a region from a list of disjoint rectangles. Empty rectangles are dropped.
    pub fn from_spans(spans: impl IntoIterator<Item = Rect>) -> Self {
        let spans: Vec<Rect> = spans.into_iter().filter(|r| !r.is_empty()).collect();
        Self::normalize(spans)
    }

    fn normalize(spans: Vec<Rect>) -> Self {
        match spans.len() {
            0 => Self::rect(Rect::EMPTY),
            1 => Self::rect(spans[0]),
            _ => {
                let bounds = spans.iter().skip(1).fold(spans[0], |acc, r| {
                    Rect::new(
                        acc.x1.min(r.x1),
                        acc.y1.min(r.y1),
                        acc.x2.max(r.x2),
                        acc.y2.max(r.y2),
                    )
                });
                Self {
                    bounds,
                    spans: Some(spans.into()),
                }
            }
        }
    }

    /// Returns the bounding rectangle.
    #[inline]
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Returns `true` if the region is exactly its bounding rectangle.
    #[inline]
    pub fn is_rectangular(&self) -> bool {
        self.spans.is_none()
    }

    /// Returns `true` if the region covers no pixel.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    /// Returns the disjoint rectangles making up the region.
    pub fn spans(&self) -> Vec<Rect> {
        match &self.spans {
            Some(spans) => spans.to_vec(),
            None if self.bounds.is_empty() => Vec::new(),
            None => vec![self.bounds],
        }
    }

    /// Returns the part of this region lying inside `rect`.
    pub fn intersect_rect(&self, rect: &Rect) -> ClipRegion {
        match &self.spans {
            None => Self::rect(self.bounds.intersect(rect)),
            Some(spans) => {
                if rect.contains_rect(&self.bounds) {
                    return self.clone();
                }
                Self::from_spans(spans.iter().map(|s| s.intersect(rect)))
            }
        }
    }

    /// Returns the region moved by `(dx, dy)`.
    pub fn translate(&self, dx: i32, dy: i32) -> ClipRegion {
        ClipRegion {
            bounds: self.bounds.translate(dx, dy),
            spans: self
                .spans
                .as_ref()
                .map(|spans| spans.iter().map(|s| s.translate(dx, dy)).collect()),
        }
    }

    /// Returns `true` if the pixel at `(x, y)` is inside the region.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        if !self.bounds.contains(x, y) {
            return false;
        }
        match &self.spans {
            None => true,
            Some(spans) => spans.iter().any(|s| s.contains(x, y)),
        }
    }
}

impl Default for ClipRegion {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl From<Rect> for ClipRegion {
    fn from(rect: Rect) -> Self {
        Self::rect(rect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn l_shape() -> ClipRegion {
        ClipRegion::from_spans([Rect::new(0, 0, 10, 5), Rect::new(0, 5, 5, 10)])
    }

    #[test]
    fn single_span_collapses_to_rectangle() {
        let r = ClipRegion::from_spans([Rect::new(1, 1, 4, 4), Rect::EMPTY]);
        assert!(r.is_rectangular());
        assert_eq!(r.bounds(), Rect::new(1, 1, 4, 4));
    }

    #[test]
    fn complex_region_membership() {
        let r = l_shape();
        assert!(!r.is_rectangular());
        assert_eq!(r.bounds(), Rect::new(0, 0, 10, 10));
        assert!(r.contains(8, 2));
        assert!(!r.contains(8, 8));
    }

    #[test]
    fn intersecting_can_make_a_region_rectangular() {
        let r = l_shape().intersect_rect(&Rect::new(0, 0, 10, 4));
        assert!(r.is_rectangular());
        assert_eq!(r.bounds(), Rect::new(0, 0, 10, 4));
    }

    #[test]
    fn translation_moves_spans() {
        let r = l_shape().translate(-5, -5);
        assert!(r.contains(3, -3));
        assert!(!r.contains(3, 3));
        assert_eq!(r.bounds(), Rect::new(-5, -5, 5, 5));
    }

    #[test]
    fn empty_rect_region() {
        let r = ClipRegion::rect(Rect::new(5, 5, 2, 2));
        assert!(r.is_empty());
        assert!(r.spans().is_empty());
    }
}
