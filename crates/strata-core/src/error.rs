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

//! Defines the hierarchy of error types shared by the queue, its executors and
//! the surface allocation API.

use crate::pixel::PixelFormat;
use crate::surface::NativeHandle;
use std::fmt;

/// An error raised while allocating or resolving a pixel-bearing resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// The driver could not allocate a surface of the requested size.
    AllocationFailed {
        /// The requested width in pixels.
        width: u32,
        /// The requested height in pixels.
        height: u32,
        /// A human-readable reason reported by the driver.
        reason: String,
    },
    /// The handle does not name a live resource.
    InvalidHandle(NativeHandle),
    /// The resource was disposed and can no longer be used.
    Disposed(NativeHandle),
    /// The pixel format is not supported by the requested operation.
    UnsupportedFormat(PixelFormat),
    /// A pixel access fell outside the resource bounds.
    OutOfBounds {
        /// The x coordinate that was accessed.
        x: i32,
        /// The y coordinate that was accessed.
        y: i32,
    },
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::AllocationFailed {
                width,
                height,
                reason,
            } => write!(f, "Failed to allocate a {width}x{height} surface: {reason}"),
            ResourceError::InvalidHandle(handle) => write!(f, "Invalid native handle: {handle}"),
            ResourceError::Disposed(handle) => write!(f, "Resource {handle} has been disposed"),
            ResourceError::UnsupportedFormat(format) => {
                write!(f, "Unsupported pixel format: {format:?}")
            }
            ResourceError::OutOfBounds { x, y } => {
                write!(f, "Pixel access at ({x}, {y}) is out of bounds")
            }
        }
    }
}

impl std::error::Error for ResourceError {}

/// An error raised by a native executor while running a record stream.
///
/// Any of these aborts the remainder of the flush that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// A record was truncated or carried an impossible field value.
    MalformedRecord {
        /// Byte offset of the record within the flushed stream.
        offset: usize,
        /// What was wrong with it.
        reason: String,
    },
    /// The stream contained an opcode the executor does not know.
    UnknownOpcode {
        /// Byte offset of the record within the flushed stream.
        offset: usize,
        /// The offending opcode.
        opcode: i32,
    },
    /// A record referenced a handle that resolves to nothing.
    UnknownHandle(NativeHandle),
    /// The driver itself reported a failure.
    Backend(String),
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionError::MalformedRecord { offset, reason } => {
                write!(f, "Malformed record at offset {offset}: {reason}")
            }
            ExecutionError::UnknownOpcode { offset, opcode } => {
                write!(f, "Unknown opcode {opcode} at offset {offset}")
            }
            ExecutionError::UnknownHandle(handle) => {
                write!(f, "Record references unknown handle {handle}")
            }
            ExecutionError::Backend(msg) => write!(f, "Native backend failure: {msg}"),
        }
    }
}

impl std::error::Error for ExecutionError {}

impl From<ResourceError> for ExecutionError {
    fn from(err: ResourceError) -> Self {
        match err {
            ResourceError::InvalidHandle(handle) | ResourceError::Disposed(handle) => {
                ExecutionError::UnknownHandle(handle)
            }
            other => ExecutionError::Backend(other.to_string()),
        }
    }
}

/// A high-level error that can occur anywhere in the rendering core.
#[derive(Debug)]
pub enum RenderError {
    /// A resource allocation or lookup failed.
    Resource(ResourceError),
    /// Running buffered records failed.
    Execution(ExecutionError),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Resource(err) => write!(f, "Resource error: {err}"),
            RenderError::Execution(err) => write!(f, "Execution error: {err}"),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Resource(err) => Some(err),
            RenderError::Execution(err) => Some(err),
        }
    }
}

impl From<ResourceError> for RenderError {
    fn from(err: ResourceError) -> Self {
        RenderError::Resource(err)
    }
}

impl From<ExecutionError> for RenderError {
    fn from(err: ExecutionError) -> Self {
        RenderError::Execution(err)
    }
}
