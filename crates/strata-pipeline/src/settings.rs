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

//! Queue configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration of a [`RenderQueue`](crate::RenderQueue).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueSettings {
    /// Initial size of the command buffer in bytes. The buffer grows past it
    /// on demand and never shrinks.
    pub initial_capacity: usize,
    /// Period of the idle auto-flush in milliseconds. `0` disables it, in
    /// which case batched records run only on an explicit flush.
    pub idle_flush_interval_ms: u64,
    /// Name given to the flusher thread.
    pub worker_name: String,
}

impl QueueSettings {
    /// Returns the idle auto-flush period, or `None` if it is disabled.
    pub fn idle_flush_interval(&self) -> Option<Duration> {
        (self.idle_flush_interval_ms > 0).then(|| Duration::from_millis(self.idle_flush_interval_ms))
    }

    /// Parses settings from JSON. Missing fields take their default values.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            initial_capacity: 32_000,
            idle_flush_interval_ms: 100,
            worker_name: "strata-queue-flusher".to_owned(),
        }
    }
}
