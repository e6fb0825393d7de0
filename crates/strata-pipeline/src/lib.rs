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

//! # Strata Pipeline
//!
//! The deferred rendering core: producers on any thread encode drawing
//! records into a shared [`CommandBuffer`] under the [`RenderQueue`] lock, and
//! a single flusher thread owns the [`NativeExecutor`](strata_core::NativeExecutor)
//! and runs those records in order.
//!
//! On top of the queue sit the [`ContextManager`], which decides which
//! state-change records a draw needs, and the [`PrimitiveRegistry`], which
//! picks the loop that moves pixels for a given (source, composite,
//! destination) triple, falling back to conversion through the canonical
//! premultiplied format when no direct loop exists.

#![warn(missing_docs)]

pub mod buffer;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod ops;
pub mod queue;
pub mod record;
pub mod retained;
pub mod settings;

pub use buffer::CommandBuffer;
pub use context::{ContextManager, ContextStats, ValidateFlags, ValidateRequest};
pub use dispatch::{
    BlitQuad, DestType, DispatchKey, DispatchTable, DrawContext, GenericStats, Geometry,
    Primitive, PrimitiveRegistry, SourceType,
};
pub use error::{PipelineError, QueueError};
pub use ops::{BlitRect, Blitter, Interpolation, ScaleRect, TransformRect};
pub use queue::{Continuation, QueueGuard, QueueStats, RenderQueue};
pub use record::{Opcode, PackedParams, Record, RecordReader};
pub use retained::RetainedSet;
pub use settings::QueueSettings;

#[cfg(test)]
pub(crate) mod testing;
