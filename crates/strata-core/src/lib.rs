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

//! # Strata Core
//!
//! Foundational crate containing the surface descriptor model, pixel formats,
//! composite rules, clip regions and the collaborator contracts consumed by the
//! deferred rendering queue in `strata-pipeline`.
//!
//! Nothing in this crate talks to a driver. It defines the 'what' (which kinds
//! of pixel storage exist, how pixels are laid out, what a native executor
//! must accept) while the 'how' lives in the pipeline and infra crates.

#![warn(missing_docs)]

pub mod composite;
pub mod error;
pub mod math;
pub mod paint;
pub mod pixel;
pub mod region;
pub mod surface;
pub mod traits;

pub use composite::{Composite, CompositeKind, CompositeRule};
pub use error::{ExecutionError, RenderError, ResourceError};
pub use math::{AffineTransform, Rect};
pub use paint::Paint;
pub use pixel::{CpuImage, PixelBuffer, PixelFormat};
pub use region::ClipRegion;
pub use surface::{
    NativeHandle, SurfaceCaps, SurfaceDescriptor, SurfaceKind, SurfaceRef, SurfaceRequest,
    Transparency,
};
pub use traits::{GraphicsConfig, NativeExecutor, ResourceTable, SourceProducer};
