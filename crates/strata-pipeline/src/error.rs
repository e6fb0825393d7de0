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

//! Errors surfaced by the queue and by the blit front end.

use crate::dispatch::{DestType, SourceType};
use strata_core::{CompositeKind, ExecutionError, ResourceError};
use thiserror::Error;

/// An error visible to code using the render queue.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Executing buffered records failed. The flusher survived and is idle again.
    #[error("flush failed: {0}")]
    FlushFailed(#[from] ExecutionError),
    /// The flusher thread is no longer running.
    #[error("the flusher thread is gone")]
    WorkerGone,
    /// A synchronous flush was requested from the flusher thread itself.
    #[error("synchronous flush requested from the flusher thread")]
    ReentrantFlush,
    /// The flusher thread could not be started.
    #[error("failed to spawn the flusher thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// An error returned by surface management and drawing operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The queue failed while running the operation.
    #[error(transparent)]
    Queue(#[from] QueueError),
    /// A resource could not be allocated or used.
    #[error(transparent)]
    Resource(#[from] ResourceError),
    /// No loop, direct or generic, can perform the operation.
    #[error("no loop moves pixels from {src:?} to {dst:?} under {composite:?}")]
    NoLoop {
        /// The source type.
        src: SourceType,
        /// The requested composite class.
        composite: CompositeKind,
        /// The destination type.
        dst: DestType,
    },
}

impl From<ExecutionError> for PipelineError {
    fn from(err: ExecutionError) -> Self {
        PipelineError::Queue(QueueError::FlushFailed(err))
    }
}
