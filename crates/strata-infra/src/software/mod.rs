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

//! A reference driver that keeps every surface in host memory.
//!
//! [`SoftwareDevice`] hands out configs and lets tests look at surface
//! pixels; [`SoftwareExecutor`] is the [`NativeExecutor`](strata_core::NativeExecutor)
//! a [`RenderQueue`](strata_pipeline::RenderQueue) drives. Both share one
//! surface store.

mod device;
mod executor;

pub use device::{DeviceLimits, SoftwareConfig, SoftwareDevice};
pub use executor::SoftwareExecutor;
