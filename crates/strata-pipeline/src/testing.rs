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

//! Fakes shared by the unit tests of this crate.

use crate::record::{Record, RecordReader};
use crate::{QueueSettings, RenderQueue};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use strata_core::{
    ExecutionError, GraphicsConfig, NativeExecutor, NativeHandle, ResourceError, ResourceTable,
    SurfaceCaps, SurfaceDescriptor, SurfaceKind, SurfaceRequest, Transparency,
};

#[derive(Debug)]
pub(crate) struct TestConfig {
    id: u64,
    caps: SurfaceCaps,
}

impl TestConfig {
    pub(crate) fn new(id: u64) -> Self {
        Self::with_caps(
            id,
            SurfaceCaps::TEXTURE_NPOT
                | SurfaceCaps::RENDER_TO_TEXTURE
                | SurfaceCaps::STORED_ALPHA
                | SurfaceCaps::DOUBLEBUFFERED,
        )
    }

    pub(crate) fn with_caps(id: u64, caps: SurfaceCaps) -> Self {
        Self { id, caps }
    }
}

impl GraphicsConfig for TestConfig {
    fn native_config(&self) -> NativeHandle {
        NativeHandle(self.id)
    }

    fn capabilities(&self) -> SurfaceCaps {
        self.caps
    }

    fn max_texture_size(&self) -> u32 {
        1024
    }
}

/// A translucent 64x64 surface.
pub(crate) fn descriptor(config: &Arc<TestConfig>, handle: u64, kind: SurfaceKind) -> SurfaceDescriptor {
    let request = SurfaceRequest::new(kind, 64, 64, Transparency::Translucent);
    let config: Arc<dyn GraphicsConfig> = config.clone();
    SurfaceDescriptor::new(NativeHandle(handle), &request, config, (64, 64))
}

pub(crate) fn surface(
    config: &Arc<TestConfig>,
    handle: u64,
    kind: SurfaceKind,
    width: u32,
    height: u32,
    transparency: Transparency,
) -> Arc<SurfaceDescriptor> {
    let request = SurfaceRequest::new(kind, width, height, transparency);
    let native = request.native_size(config.caps);
    let config: Arc<dyn GraphicsConfig> = config.clone();
    Arc::new(SurfaceDescriptor::new(NativeHandle(handle), &request, config, native))
}

/// What a [`FakeExecutor`] saw.
#[derive(Debug, Clone, Default)]
pub(crate) struct ExecLog {
    records: Arc<Mutex<Vec<Record>>>,
    calls: Arc<AtomicUsize>,
    allocations: Arc<Mutex<Vec<SurfaceRequest>>>,
}

impl ExecLog {
    /// Every executed record except padding, in order.
    pub(crate) fn records(&self) -> Vec<Record> {
        self.records.lock().clone()
    }

    pub(crate) fn execute_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn allocations(&self) -> Vec<SurfaceRequest> {
        self.allocations.lock().clone()
    }

    pub(crate) fn clear(&self) {
        self.records.lock().clear();
    }
}

/// Decodes and logs records instead of drawing them.
#[derive(Debug, Default)]
pub(crate) struct FakeExecutor {
    log: ExecLog,
    fail_on: Option<Record>,
    next_handle: AtomicU64,
}

impl FakeExecutor {
    /// Fails any block containing `record`, after logging it.
    pub(crate) fn failing_on(record: Record) -> Self {
        Self {
            fail_on: Some(record),
            ..Self::default()
        }
    }
}

impl NativeExecutor for FakeExecutor {
    fn execute(&mut self, records: &[u8], _resources: &dyn ResourceTable) -> Result<(), ExecutionError> {
        self.log.calls.fetch_add(1, Ordering::SeqCst);
        for item in RecordReader::new(records) {
            let (_, record) = item?;
            if record == Record::Noop {
                continue;
            }
            let fail = self.fail_on.as_ref() == Some(&record);
            self.log.records.lock().push(record);
            if fail {
                return Err(ExecutionError::Backend("injected failure".to_owned()));
            }
        }
        Ok(())
    }

    fn allocate_surface(
        &mut self,
        _config: NativeHandle,
        request: &SurfaceRequest,
    ) -> Result<NativeHandle, ResourceError> {
        self.log.allocations.lock().push(*request);
        Ok(NativeHandle(1000 + self.next_handle.fetch_add(1, Ordering::SeqCst)))
    }
}

/// A queue over `executor` with the given idle flush period (`0` disables it).
pub(crate) fn queue_with(executor: FakeExecutor, idle_flush_interval_ms: u64) -> (RenderQueue, ExecLog) {
    let _ = env_logger::builder().is_test(true).try_init();
    let log = executor.log.clone();
    let settings = QueueSettings {
        initial_capacity: 512,
        idle_flush_interval_ms,
        worker_name: "strata-test-flusher".to_owned(),
    };
    let queue = RenderQueue::new(executor, settings).expect("flusher thread spawns");
    (queue, log)
}
