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

//! # Strata Infra
//!
//! Concrete implementations of the collaborators `strata-pipeline` consumes.
//!
//! - [`software`]: a reference driver keeping every surface in host memory.
//!   [`SoftwareExecutor`] interprets the full record stream against it.
//! - [`recording`]: an executor that keeps every flushed block, decoded, for
//!   inspection. It can wrap another executor.
//! - [`logging`]: `env_logger` bootstrap for binaries and tests.

#![warn(missing_docs)]

pub mod logging;
pub mod recording;
pub mod software;

pub use recording::{Recording, RecordingExecutor};
pub use software::{DeviceLimits, SoftwareConfig, SoftwareDevice, SoftwareExecutor};
