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

//! A 2D affine transform in row-major `[m00 m01 m02; m10 m11 m12]` form.

/// A 2D affine transform.
///
/// Points map as `x' = m00*x + m01*y + m02` and `y' = m10*x + m11*y + m12`.
/// Equality is bit-for-bit on the six coefficients, which is what the context
/// cache needs to decide whether the bound transform is still current.
#[derive(Debug, Clone, Copy)]
pub struct AffineTransform {
    /// X scale / rotation coefficient.
    pub m00: f64,
    /// Y shear / rotation coefficient.
    pub m10: f64,
    /// X shear / rotation coefficient.
    pub m01: f64,
    /// Y scale / rotation coefficient.
    pub m11: f64,
    /// X translation.
    pub m02: f64,
    /// Y translation.
    pub m12: f64,
}

impl AffineTransform {
    /// The identity transform.
    pub const IDENTITY: Self = Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);

    /// Creates a transform from its coefficients, in the order they are
    /// written into a `SET_TRANSFORM` record.
    #[inline]
    pub const fn new(m00: f64, m10: f64, m01: f64, m11: f64, m02: f64, m12: f64) -> Self {
        Self {
            m00,
            m10,
            m01,
            m11,
            m02,
            m12,
        }
    }

    /// Creates a pure translation.
    #[inline]
    pub const fn translation(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// Creates a pure scale about the origin.
    #[inline]
    pub const fn scale(sx: f64, sy: f64) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// Creates a rotation by `theta` radians about the origin.
    pub fn rotation(theta: f64) -> Self {
        let (sin, cos) = theta.sin_cos();
        Self::new(cos, sin, -sin, cos, 0.0, 0.0)
    }

    /// Creates the transform mapping the source rectangle onto the destination rectangle.
    #[allow(clippy::too_many_arguments)]
    pub fn rect_to_rect(
        sx1: f64,
        sy1: f64,
        sx2: f64,
        sy2: f64,
        dx1: f64,
        dy1: f64,
        dx2: f64,
        dy2: f64,
    ) -> Self {
        let sx = if sx2 != sx1 { (dx2 - dx1) / (sx2 - sx1) } else { 0.0 };
        let sy = if sy2 != sy1 { (dy2 - dy1) / (sy2 - sy1) } else { 0.0 };
        Self::new(sx, 0.0, 0.0, sy, dx1 - sx1 * sx, dy1 - sy1 * sy)
    }

    /// Returns the transform that applies `self` first and then `next`.
    pub fn then(&self, next: &AffineTransform) -> AffineTransform {
        AffineTransform {
            m00: next.m00 * self.m00 + next.m01 * self.m10,
            m01: next.m00 * self.m01 + next.m01 * self.m11,
            m02: next.m00 * self.m02 + next.m01 * self.m12 + next.m02,
            m10: next.m10 * self.m00 + next.m11 * self.m10,
            m11: next.m10 * self.m01 + next.m11 * self.m11,
            m12: next.m10 * self.m02 + next.m11 * self.m12 + next.m12,
        }
    }

    /// Maps a point.
    #[inline]
    pub fn transform_point(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.m00 * x + self.m01 * y + self.m02,
            self.m10 * x + self.m11 * y + self.m12,
        )
    }

    /// Returns the inverse transform, or `None` if the transform is singular.
    pub fn inverse(&self) -> Option<AffineTransform> {
        let det = self.m00 * self.m11 - self.m01 * self.m10;
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        Some(AffineTransform {
            m00: self.m11 / det,
            m01: -self.m01 / det,
            m10: -self.m10 / det,
            m11: self.m00 / det,
            m02: (self.m01 * self.m12 - self.m11 * self.m02) / det,
            m12: (self.m10 * self.m02 - self.m00 * self.m12) / det,
        })
    }

    /// Returns the axis-aligned bounds `(x1, y1, x2, y2)` of a transformed rectangle.
    pub fn transform_bounds(&self, x1: f64, y1: f64, x2: f64, y2: f64) -> (f64, f64, f64, f64) {
        let corners = [
            self.transform_point(x1, y1),
            self.transform_point(x2, y1),
            self.transform_point(x1, y2),
            self.transform_point(x2, y2),
        ];
        corners.iter().fold(
            (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            |(lx, ly, hx, hy), &(x, y)| (lx.min(x), ly.min(y), hx.max(x), hy.max(y)),
        )
    }

    /// Returns `true` if this is exactly the identity.
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Returns `true` if the transform only translates.
    pub fn is_translation(&self) -> bool {
        self.m00 == 1.0 && self.m10 == 0.0 && self.m01 == 0.0 && self.m11 == 1.0
    }

    /// Returns the coefficients in record order `[m00, m10, m01, m11, m02, m12]`.
    pub fn to_array(&self) -> [f64; 6] {
        [self.m00, self.m10, self.m01, self.m11, self.m02, self.m12]
    }

    /// Creates a transform from coefficients in record order.
    pub fn from_array(m: [f64; 6]) -> Self {
        Self::new(m[0], m[1], m[2], m[3], m[4], m[5])
    }
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl PartialEq for AffineTransform {
    fn eq(&self, other: &Self) -> bool {
        self.to_array()
            .iter()
            .zip(other.to_array().iter())
            .all(|(a, b)| a.to_bits() == b.to_bits())
    }
}

impl Eq for AffineTransform {}
