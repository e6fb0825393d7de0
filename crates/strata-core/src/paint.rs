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

//! The paint applied by fill-style operations.

use serde::{Deserialize, Serialize};

/// The paint bound to a context.
///
/// Only flat colour is expressed here; translating richer paints into shader
/// state is the driver's concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Paint {
    /// A flat, non-premultiplied ARGB colour.
    Color(u32),
}

impl Paint {
    /// Returns the colour as a premultiplied ARGB pixel, the form written into
    /// `SET_COLOR` records.
    pub fn argb_pre(&self) -> u32 {
        match *self {
            Paint::Color(argb) => crate::pixel::premultiply(argb),
        }
    }
}

impl Default for Paint {
    fn default() -> Self {
        Paint::Color(0xFF00_0000)
    }
}
