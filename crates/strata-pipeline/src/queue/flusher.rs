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

//! The dedicated thread that owns the native executor.

use super::QueueShared;
use crate::error::QueueError;
use crate::retained::RetainedSet;
use crate::settings::QueueSettings;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;
use strata_core::{ExecutionError, NativeExecutor, ResourceTable};

/// A one-shot callback run on the flusher thread right after a successful
/// flush, before the waiting producer is released.
pub type Continuation = Box<dyn FnOnce(&mut dyn NativeExecutor) + Send + 'static>;

/// A block of records handed to the worker by a producer holding the queue lock.
pub(crate) struct FlushJob {
    pub records: Vec<u8>,
    pub record_count: usize,
    pub retained: RetainedSet,
    pub continuation: Option<Continuation>,
}

/// The storage of a finished job, handed back cleared, with its result.
pub(crate) struct FlushOutcome {
    pub records: Vec<u8>,
    pub retained: RetainedSet,
    pub result: Result<(), ExecutionError>,
}

enum Message {
    Flush(FlushJob),
    Shutdown,
}

/// Handle to the flusher thread.
pub(crate) struct QueueFlusher {
    tx: Sender<Message>,
    done_rx: Receiver<FlushOutcome>,
    worker: Option<JoinHandle<()>>,
    worker_id: ThreadId,
}

impl QueueFlusher {
    /// Starts the flusher thread.
    pub(crate) fn spawn(
        executor: Box<dyn NativeExecutor>,
        shared: Arc<QueueShared>,
        settings: &QueueSettings,
    ) -> Result<Self, QueueError> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        let interval = settings.idle_flush_interval();
        let worker = Worker {
            executor,
            shared,
            done_tx,
        };
        let handle = thread::Builder::new()
            .name(settings.worker_name.clone())
            .spawn(move || worker.run(rx, interval))
            .map_err(QueueError::Spawn)?;
        let worker_id = handle.thread().id();
        Ok(Self {
            tx,
            done_rx,
            worker: Some(handle),
            worker_id,
        })
    }

    /// Returns `true` when called from the flusher thread.
    pub(crate) fn is_worker_thread(&self) -> bool {
        thread::current().id() == self.worker_id
    }

    /// Hands a job to the worker and blocks until it is done.
    pub(crate) fn run(&self, job: FlushJob) -> Result<FlushOutcome, QueueError> {
        self.tx
            .send(Message::Flush(job))
            .map_err(|_| QueueError::WorkerGone)?;
        self.done_rx.recv().map_err(|_| QueueError::WorkerGone)
    }
}

impl Drop for QueueFlusher {
    fn drop(&mut self) {
        let _ = self.tx.send(Message::Shutdown);
        if self.is_worker_thread() {
            return;
        }
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                log::error!("Queue flusher thread panicked during shutdown.");
            }
        }
    }
}

struct Worker {
    executor: Box<dyn NativeExecutor>,
    shared: Arc<QueueShared>,
    done_tx: Sender<FlushOutcome>,
}

impl Worker {
    fn run(mut self, rx: Receiver<Message>, interval: Option<Duration>) {
        log::info!("Queue flusher thread started.");
        loop {
            let message = match interval {
                Some(interval) => match rx.recv_timeout(interval) {
                    Ok(message) => message,
                    Err(RecvTimeoutError::Timeout) => {
                        self.auto_flush();
                        continue;
                    }
                    Err(RecvTimeoutError::Disconnected) => break,
                },
                None => match rx.recv() {
                    Ok(message) => message,
                    Err(_) => break,
                },
            };
            match message {
                Message::Flush(job) => {
                    let outcome = self.flush(job);
                    if self.done_tx.send(outcome).is_err() {
                        log::error!("Flush requester vanished; stopping flusher.");
                        break;
                    }
                }
                Message::Shutdown => break,
            }
        }
        log::info!("Queue flusher thread stopped.");
    }

    fn flush(&mut self, job: FlushJob) -> FlushOutcome {
        let FlushJob {
            records,
            record_count,
            mut retained,
            continuation,
        } = job;

        let mut result = Ok(());
        if !records.is_empty() {
            result = execute_block(self.executor.as_mut(), &records, &retained);
            self.shared
                .counters
                .record_flush(records.len(), record_count, result.is_err(), false);
        }
        retained.clear();

        if let Some(continuation) = continuation {
            if result.is_ok() {
                let executor = self.executor.as_mut();
                if let Err(payload) =
                    panic::catch_unwind(AssertUnwindSafe(move || continuation(executor)))
                {
                    result = Err(ExecutionError::Backend(format!(
                        "post-flush callback panicked: {}",
                        panic_message(payload.as_ref())
                    )));
                }
            } else {
                log::warn!("Skipping post-flush callback after a failed flush.");
            }
        }

        FlushOutcome {
            records,
            retained,
            result,
        }
    }

    /// Flushes batched records if no producer holds the lock.
    fn auto_flush(&mut self) {
        let Some(cell) = self.shared.lock.try_lock() else {
            return;
        };
        let mut buffer = cell.buffer.borrow_mut();
        if buffer.is_empty() {
            return;
        }
        let mut retained = cell.retained.borrow_mut();
        let result = execute_block(self.executor.as_mut(), buffer.as_bytes(), &*retained);
        let record_count = buffer.record_count();
        let bytes = buffer.position_and_clear();
        retained.clear();
        self.shared
            .counters
            .record_flush(bytes, record_count, result.is_err(), true);
        log::trace!("Auto-flushed {record_count} records ({bytes} bytes).");

        if let Err(err) = result {
            log::warn!("Auto-flush failed: {err}");
            let mut pending = self.shared.pending_error.lock();
            if pending.is_none() {
                *pending = Some(err);
            }
        }
    }
}

fn execute_block(
    executor: &mut dyn NativeExecutor,
    records: &[u8],
    resources: &dyn ResourceTable,
) -> Result<(), ExecutionError> {
    match panic::catch_unwind(AssertUnwindSafe(|| executor.execute(records, resources))) {
        Ok(result) => result,
        Err(payload) => Err(ExecutionError::Backend(format!(
            "executor panicked: {}",
            panic_message(payload.as_ref())
        ))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}
