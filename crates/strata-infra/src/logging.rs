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

//! Logger bootstrap.

use env_logger::{Builder, Env};

/// Installs the global logger for a binary.
///
/// The filter comes from `RUST_LOG` and defaults to `info`. Calling it a
/// second time is a no-op.
pub fn init() {
    let _ = Builder::from_env(Env::default().default_filter_or("info")).try_init();
}

/// Installs a logger whose output the test harness captures. Safe to call
/// from every test.
pub fn init_for_tests() {
    let _ = Builder::from_env(Env::default().default_filter_or("debug"))
        .is_test(true)
        .try_init();
}
