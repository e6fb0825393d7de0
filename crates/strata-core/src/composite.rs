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

//! Composite (blend) modes and the dispatch classes they fall into.

use serde::{Deserialize, Serialize};

/// The Porter-Duff rules supported by alpha compositing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompositeRule {
    /// Both colour and alpha of the destination are cleared.
    Clear,
    /// The source replaces the destination.
    Src,
    /// The source is composited over the destination.
    SrcOver,
}

impl CompositeRule {
    /// The integer id written into `SET_ALPHA_COMPOSITE` records.
    pub const fn id(self) -> i32 {
        match self {
            CompositeRule::Clear => 1,
            CompositeRule::Src => 2,
            CompositeRule::SrcOver => 3,
        }
    }

    /// Looks up a rule by its record id.
    pub const fn from_id(id: i32) -> Option<Self> {
        match id {
            1 => Some(CompositeRule::Clear),
            2 => Some(CompositeRule::Src),
            3 => Some(CompositeRule::SrcOver),
            _ => None,
        }
    }
}

/// The pixel-combination rule applied when writing into a destination.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum Composite {
    /// Porter-Duff compositing modulated by a constant extra alpha in `[0, 1]`.
    Alpha {
        /// The Porter-Duff rule.
        rule: CompositeRule,
        /// Constant alpha applied to every source pixel.
        extra_alpha: f32,
    },
    /// XOR painting: destination colour bits are flipped by `source ^ xor_pixel`
    /// wherever the source is at least half opaque.
    Xor {
        /// The canonical (premultiplied ARGB) pixel xored into the source.
        xor_pixel: u32,
    },
}

impl Composite {
    /// Default `SrcOver` with full extra alpha.
    pub const SRC_OVER: Self = Composite::Alpha {
        rule: CompositeRule::SrcOver,
        extra_alpha: 1.0,
    };

    /// Opaque copy: `Src` with full extra alpha.
    pub const SRC: Self = Composite::Alpha {
        rule: CompositeRule::Src,
        extra_alpha: 1.0,
    };

    /// Creates an alpha composite, clamping the extra alpha into `[0, 1]`.
    pub fn alpha(rule: CompositeRule, extra_alpha: f32) -> Self {
        let extra_alpha = if extra_alpha.is_nan() {
            1.0
        } else {
            extra_alpha.clamp(0.0, 1.0)
        };
        Composite::Alpha { rule, extra_alpha }
    }

    /// Creates an XOR composite.
    pub const fn xor(xor_pixel: u32) -> Self {
        Composite::Xor { xor_pixel }
    }

    /// Returns the dispatch class of this composite.
    pub fn kind(&self) -> CompositeKind {
        match *self {
            Composite::Alpha { rule, extra_alpha } => {
                let full = extra_alpha >= 1.0;
                match rule {
                    CompositeRule::Src if full => CompositeKind::SrcNoEa,
                    CompositeRule::Src => CompositeKind::Src,
                    CompositeRule::SrcOver if full => CompositeKind::SrcOverNoEa,
                    CompositeRule::SrcOver => CompositeKind::SrcOver,
                    CompositeRule::Clear => CompositeKind::AnyAlpha,
                }
            }
            Composite::Xor { .. } => CompositeKind::Xor,
        }
    }

    /// Returns the extra alpha as an 8-bit coverage value.
    pub fn extra_alpha_u8(&self) -> u8 {
        match *self {
            Composite::Alpha { extra_alpha, .. } => (extra_alpha * 255.0 + 0.5) as u8,
            Composite::Xor { .. } => 0xFF,
        }
    }

    /// Returns `true` if this composite is a plain opaque copy.
    pub fn is_opaque_copy(&self) -> bool {
        self.kind() == CompositeKind::SrcNoEa
    }
}

impl Default for Composite {
    fn default() -> Self {
        Self::SRC_OVER
    }
}

impl PartialEq for Composite {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Composite::Alpha {
                    rule: a,
                    extra_alpha: ea,
                },
                Composite::Alpha {
                    rule: b,
                    extra_alpha: eb,
                },
            ) => a == b && ea.to_bits() == eb.to_bits(),
            (Composite::Xor { xor_pixel: a }, Composite::Xor { xor_pixel: b }) => a == b,
            _ => false,
        }
    }
}

impl Eq for Composite {}

/// The composite class a dispatch entry is registered for.
///
/// The concrete classes form a two-level hierarchy: every alpha class
/// generalizes to [`CompositeKind::AnyAlpha`], and `Xor` generalizes straight to
/// [`CompositeKind::Any`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CompositeKind {
    /// `Src` with full extra alpha (opaque copy).
    SrcNoEa,
    /// `Src` with partial extra alpha.
    Src,
    /// `SrcOver` with full extra alpha.
    SrcOverNoEa,
    /// `SrcOver` with partial extra alpha.
    SrcOver,
    /// XOR painting.
    Xor,
    /// Any alpha composite.
    AnyAlpha,
    /// Any composite at all.
    Any,
}

impl CompositeKind {
    /// Returns the broadest class this kind belongs to.
    pub const fn broadest(self) -> Self {
        match self {
            CompositeKind::Xor | CompositeKind::Any => CompositeKind::Any,
            _ => CompositeKind::AnyAlpha,
        }
    }

    /// Returns `true` if an entry registered for `self` handles `requested`.
    pub fn covers(self, requested: CompositeKind) -> bool {
        self == requested
            || self == CompositeKind::Any
            || (self == CompositeKind::AnyAlpha && requested.broadest() == CompositeKind::AnyAlpha)
    }
}
