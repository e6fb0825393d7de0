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

//! An executor that keeps what it is asked to run.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use strata_core::{
    ExecutionError, NativeExecutor, NativeHandle, ResourceError, ResourceTable, SurfaceRequest,
};
use strata_pipeline::{Opcode, Record, RecordReader};

#[derive(Debug, Default)]
struct RecordingLog {
    blocks: Vec<Vec<u8>>,
    allocations: Vec<SurfaceRequest>,
}

/// A shared view of everything a [`RecordingExecutor`] saw. Clones observe
/// the same log, so a test keeps one while the executor moves to the
/// flusher thread.
#[derive(Debug, Clone, Default)]
pub struct Recording {
    log: Arc<Mutex<RecordingLog>>,
}

impl Recording {
    /// The raw bytes of every executed block, in order.
    pub fn blocks(&self) -> Vec<Vec<u8>> {
        self.log.lock().blocks.clone()
    }

    /// Number of `execute` calls, which is the number of non-empty flushes.
    pub fn block_count(&self) -> usize {
        self.log.lock().blocks.len()
    }

    /// Every executed record except padding, in order. Decoding a block stops
    /// at its first malformed record.
    pub fn records(&self) -> Vec<Record> {
        self.log
            .lock()
            .blocks
            .iter()
            .flat_map(|block| RecordReader::new(block).map_while(Result::ok))
            .map(|(_, record)| record)
            .filter(|record| *record != Record::Noop)
            .collect()
    }

    /// The opcodes of [`Recording::records`].
    pub fn opcodes(&self) -> Vec<Opcode> {
        self.records().iter().map(Record::opcode).collect()
    }

    /// How many executed records carry `opcode`.
    pub fn count(&self, opcode: Opcode) -> usize {
        self.records().iter().filter(|r| r.opcode() == opcode).count()
    }

    /// Every allocation request, in order.
    pub fn allocations(&self) -> Vec<SurfaceRequest> {
        self.log.lock().allocations.clone()
    }

    /// Forgets everything recorded so far.
    pub fn clear(&self) {
        let mut log = self.log.lock();
        log.blocks.clear();
        log.allocations.clear();
    }
}

/// Records every block before running it.
///
/// On its own it only checks that blocks decode and hands out sequential
/// surface handles. [`RecordingExecutor::wrapping`] forwards to a real
/// executor after recording.
pub struct RecordingExecutor {
    recording: Recording,
    inner: Option<Box<dyn NativeExecutor>>,
    next_handle: u64,
}

impl Default for RecordingExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingExecutor {
    /// A standalone recorder.
    pub fn new() -> Self {
        Self {
            recording: Recording::default(),
            inner: None,
            next_handle: 1,
        }
    }

    /// A recorder in front of `inner`.
    pub fn wrapping(inner: impl NativeExecutor + 'static) -> Self {
        Self {
            inner: Some(Box::new(inner)),
            ..Self::new()
        }
    }

    /// A handle on the log. Take it before the executor moves into a queue.
    pub fn recording(&self) -> Recording {
        self.recording.clone()
    }
}

impl fmt::Debug for RecordingExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingExecutor")
            .field("blocks", &self.recording.block_count())
            .field("wrapping", &self.inner.is_some())
            .finish()
    }
}

impl NativeExecutor for RecordingExecutor {
    fn execute(
        &mut self,
        records: &[u8],
        resources: &dyn ResourceTable,
    ) -> Result<(), ExecutionError> {
        self.recording.log.lock().blocks.push(records.to_vec());
        match self.inner.as_mut() {
            Some(inner) => inner.execute(records, resources),
            None => RecordReader::new(records).try_for_each(|item| item.map(|_| ())),
        }
    }

    fn allocate_surface(
        &mut self,
        config: NativeHandle,
        request: &SurfaceRequest,
    ) -> Result<NativeHandle, ResourceError> {
        self.recording.log.lock().allocations.push(*request);
        match self.inner.as_mut() {
            Some(inner) => inner.allocate_surface(config, request),
            None => {
                let handle = NativeHandle(self.next_handle);
                self.next_handle += 1;
                Ok(handle)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_pipeline::CommandBuffer;

    struct NoImages;

    impl ResourceTable for NoImages {
        fn cpu_image(&self, _handle: NativeHandle) -> Option<&Arc<strata_core::CpuImage>> {
            None
        }
    }

    #[test]
    fn records_blocks_and_decodes_them() {
        let mut executor = RecordingExecutor::new();
        let recording = executor.recording();
        let mut buf = CommandBuffer::with_capacity(64);
        Record::Sync.encode(&mut buf);
        Record::SwapBuffers(NativeHandle(3)).encode(&mut buf);
        executor.execute(buf.as_bytes(), &NoImages).unwrap();

        assert_eq!(recording.block_count(), 1);
        assert_eq!(recording.blocks()[0].len(), 4 + 12);
        assert_eq!(recording.opcodes(), vec![Opcode::Sync, Opcode::SwapBuffers]);
        assert_eq!(recording.count(Opcode::Sync), 1);

        recording.clear();
        assert_eq!(recording.block_count(), 0);
    }

    #[test]
    fn standalone_recorder_rejects_garbage() {
        let mut executor = RecordingExecutor::new();
        let err = executor.execute(&[1, 2, 3, 4], &NoImages).unwrap_err();
        assert!(matches!(err, ExecutionError::UnknownOpcode { .. }));
        assert!(executor.recording().records().is_empty());
    }

    #[test]
    fn standalone_handles_are_sequential() {
        let mut executor = RecordingExecutor::new();
        let request = SurfaceRequest::new(
            strata_core::SurfaceKind::Texture,
            1,
            1,
            strata_core::Transparency::Opaque,
        );
        assert_eq!(executor.allocate_surface(NativeHandle(1), &request), Ok(NativeHandle(1)));
        assert_eq!(executor.allocate_surface(NativeHandle(1), &request), Ok(NativeHandle(2)));
        assert_eq!(executor.recording().allocations().len(), 2);
    }
}
