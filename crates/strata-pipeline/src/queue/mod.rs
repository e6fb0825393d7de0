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

//! The render queue: one command buffer, one retained set and one context
//! cache behind one reentrant lock, drained by one flusher thread.

mod flusher;
mod surfaces;

pub use flusher::Continuation;

use crate::buffer::CommandBuffer;
use crate::context::{ContextManager, ContextStats, ValidateRequest};
use crate::error::QueueError;
use crate::record::Record;
use crate::retained::RetainedSet;
use crate::settings::QueueSettings;
use flusher::{FlushJob, QueueFlusher};
use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard};
use std::cell::{RefCell, RefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use strata_core::{
    CpuImage, ExecutionError, GraphicsConfig, NativeExecutor, SurfaceDescriptor, SurfaceRef,
};

/// State only touched by the thread holding the queue lock.
pub(crate) struct QueueCell {
    pub(crate) buffer: RefCell<CommandBuffer>,
    pub(crate) retained: RefCell<RetainedSet>,
    pub(crate) context: RefCell<ContextManager>,
}

#[derive(Default)]
pub(crate) struct QueueCounters {
    flushes: AtomicU64,
    auto_flushes: AtomicU64,
    records: AtomicU64,
    bytes: AtomicU64,
    failures: AtomicU64,
}

impl QueueCounters {
    pub(crate) fn record_flush(&self, bytes: usize, records: usize, failed: bool, auto: bool) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        if auto {
            self.auto_flushes.fetch_add(1, Ordering::Relaxed);
        }
        self.records.fetch_add(records as u64, Ordering::Relaxed);
        self.bytes.fetch_add(bytes as u64, Ordering::Relaxed);
        if failed {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// State shared between producers and the flusher thread.
pub(crate) struct QueueShared {
    pub(crate) lock: ReentrantMutex<QueueCell>,
    pub(crate) counters: QueueCounters,
    /// A failure captured by an auto-flush, waiting for the next explicit flush.
    pub(crate) pending_error: Mutex<Option<ExecutionError>>,
}

/// A snapshot of the queue counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Non-empty flushes, explicit and automatic.
    pub flushes: u64,
    /// Flushes started by the idle timer.
    pub auto_flushes: u64,
    /// Records executed, padding excluded.
    pub records: u64,
    /// Bytes executed.
    pub bytes: u64,
    /// Flushes that failed.
    pub failures: u64,
}

static GLOBAL: OnceLock<Arc<RenderQueue>> = OnceLock::new();

/// The deferred render queue.
///
/// Producers on any thread take the lock with [`RenderQueue::lock`], encode
/// records, retain the resources those records reference, and optionally
/// flush. The flusher thread is the only thread that ever calls the
/// [`NativeExecutor`].
pub struct RenderQueue {
    shared: Arc<QueueShared>,
    flusher: QueueFlusher,
    settings: QueueSettings,
}

impl RenderQueue {
    /// Creates a queue and starts its flusher thread.
    ///
    /// ## Arguments
    /// * `executor` - The native side. It moves to the flusher thread.
    /// * `settings` - Buffer size, idle flush period and thread name.
    pub fn new(
        executor: impl NativeExecutor + 'static,
        settings: QueueSettings,
    ) -> Result<Self, QueueError> {
        let shared = Arc::new(QueueShared {
            lock: ReentrantMutex::new(QueueCell {
                buffer: RefCell::new(CommandBuffer::with_capacity(settings.initial_capacity)),
                retained: RefCell::new(RetainedSet::new()),
                context: RefCell::new(ContextManager::new()),
            }),
            counters: QueueCounters::default(),
            pending_error: Mutex::new(None),
        });
        let flusher = QueueFlusher::spawn(Box::new(executor), Arc::clone(&shared), &settings)?;
        log::info!(
            "Render queue created (capacity {} bytes, idle flush {:?}).",
            settings.initial_capacity,
            settings.idle_flush_interval()
        );
        Ok(Self {
            shared,
            flusher,
            settings,
        })
    }

    /// Installs the process-wide queue. Fails, handing the queue back, if one
    /// is already installed.
    pub fn install(queue: Arc<RenderQueue>) -> Result<Arc<RenderQueue>, Arc<RenderQueue>> {
        GLOBAL.set(Arc::clone(&queue))?;
        Ok(queue)
    }

    /// The process-wide queue, if one was installed.
    pub fn global() -> Option<Arc<RenderQueue>> {
        GLOBAL.get().cloned()
    }

    /// Acquires the queue lock. Reentrant on the same thread.
    ///
    /// # Panics
    /// Panics when called from the flusher thread: the producer that owns the
    /// lock is waiting on that thread, so blocking here would deadlock.
    pub fn lock(&self) -> QueueGuard<'_> {
        assert!(
            !self.is_worker_thread(),
            "render queue locked from its own flusher thread"
        );
        QueueGuard {
            queue: self,
            cell: self.shared.lock.lock(),
        }
    }

    /// Acquires the queue lock if no other thread holds it.
    pub fn try_lock(&self) -> Option<QueueGuard<'_>> {
        if self.is_worker_thread() {
            return None;
        }
        self.shared.lock.try_lock().map(|cell| QueueGuard { queue: self, cell })
    }

    /// Returns `true` when called from this queue's flusher thread, for
    /// example from inside a post-flush callback.
    pub fn is_worker_thread(&self) -> bool {
        self.flusher.is_worker_thread()
    }

    /// The settings this queue was created with.
    pub fn settings(&self) -> &QueueSettings {
        &self.settings
    }

    /// A snapshot of the flush counters.
    pub fn stats(&self) -> QueueStats {
        let c = &self.shared.counters;
        QueueStats {
            flushes: c.flushes.load(Ordering::Relaxed),
            auto_flushes: c.auto_flushes.load(Ordering::Relaxed),
            records: c.records.load(Ordering::Relaxed),
            bytes: c.bytes.load(Ordering::Relaxed),
            failures: c.failures.load(Ordering::Relaxed),
        }
    }

    /// A snapshot of the context cache counters. Takes the lock.
    pub fn context_stats(&self) -> ContextStats {
        self.lock().context().stats()
    }

    /// Takes the lock and flushes.
    pub fn flush_now(&self) -> Result<(), QueueError> {
        self.lock().flush_now()
    }
}

impl std::fmt::Debug for RenderQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderQueue")
            .field("settings", &self.settings)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

/// Proof that the calling thread holds the queue lock.
///
/// Every buffer write and every context decision goes through a guard. The
/// borrow accessors hand out `RefMut`s; holding one across a flush is a bug
/// and panics.
pub struct QueueGuard<'a> {
    queue: &'a RenderQueue,
    cell: ReentrantMutexGuard<'a, QueueCell>,
}

impl<'a> QueueGuard<'a> {
    /// The queue this guard locks.
    pub fn queue(&self) -> &'a RenderQueue {
        self.queue
    }

    /// The command buffer.
    pub fn buffer(&self) -> RefMut<'_, CommandBuffer> {
        self.cell.buffer.borrow_mut()
    }

    /// The context cache.
    pub fn context(&self) -> RefMut<'_, ContextManager> {
        self.cell.context.borrow_mut()
    }

    /// Guarantees room for the next `bytes` bytes.
    pub fn ensure_capacity(&self, bytes: usize) {
        self.buffer().ensure_capacity(bytes);
    }

    /// Guarantees room for a record whose first 8-byte field sits at
    /// `first_long_offset`, padding for alignment if needed.
    pub fn ensure_capacity_and_alignment(&self, bytes: usize, first_long_offset: usize) {
        self.buffer()
            .ensure_capacity_and_alignment(bytes, first_long_offset);
    }

    /// Encodes one record.
    pub fn enqueue(&self, record: &Record) {
        record.encode(&mut self.buffer());
    }

    /// Keeps `resource` alive until the next flush completes.
    pub fn retain(&self, resource: &SurfaceRef) {
        self.cell.retained.borrow_mut().add(resource);
    }

    /// Keeps a surface alive until the next flush completes.
    pub fn retain_surface(&self, desc: &Arc<SurfaceDescriptor>) {
        self.cell.retained.borrow_mut().add_surface(desc);
    }

    /// Keeps a CPU image alive until the next flush completes.
    pub fn retain_image(&self, image: &Arc<CpuImage>) {
        self.cell.retained.borrow_mut().add_image(image);
    }

    /// Number of resources retained for the next flush.
    pub fn retained_len(&self) -> usize {
        self.cell.retained.borrow().len()
    }

    /// Records waiting for a flush.
    pub fn pending_records(&self) -> usize {
        self.cell.buffer.borrow().record_count()
    }

    /// Binds the context for a draw, encoding only the state that changed.
    pub fn validate(&self, req: &ValidateRequest<'_>) {
        let mut buffer = self.buffer();
        self.context().validate(&mut buffer, req);
    }

    /// Binds the scratch surface of `config`.
    pub fn bind_scratch(&self, config: &dyn GraphicsConfig) {
        let mut buffer = self.buffer();
        self.context().bind_scratch(&mut buffer, config);
    }

    /// Drops the context binding on both sides of the queue and flushes.
    pub fn invalidate_context(&self) -> Result<(), QueueError> {
        self.context().invalidate();
        self.enqueue(&Record::InvalidateContext);
        self.flush_now()
    }

    /// Makes the driver finish all outstanding work.
    pub fn sync(&self) -> Result<(), QueueError> {
        self.enqueue(&Record::Sync);
        self.flush_now()
    }

    /// Executes every buffered record on the flusher thread and waits.
    ///
    /// Flushing an empty buffer makes no native call. A failure captured by
    /// an earlier idle auto-flush is reported here.
    pub fn flush_now(&self) -> Result<(), QueueError> {
        self.flush_inner(None)
    }

    /// Flushes, then runs `callback` on the flusher thread before returning.
    /// The callback runs even if the buffer is empty, and is skipped if the
    /// flush fails.
    pub fn flush_and_invoke(
        &self,
        callback: impl FnOnce(&mut dyn NativeExecutor) + Send + 'static,
    ) -> Result<(), QueueError> {
        self.flush_inner(Some(Box::new(callback)))
    }

    fn flush_inner(&self, continuation: Option<Continuation>) -> Result<(), QueueError> {
        if self.queue.is_worker_thread() {
            return Err(QueueError::ReentrantFlush);
        }
        let pending = self.queue.shared.pending_error.lock().take();
        let mut buffer = self.buffer();
        if buffer.is_empty() && continuation.is_none() {
            return pending.map_or(Ok(()), |err| Err(err.into()));
        }

        let job = FlushJob {
            record_count: buffer.record_count(),
            records: buffer.take_storage(),
            retained: std::mem::take(&mut *self.cell.retained.borrow_mut()),
            continuation,
        };
        log::trace!("Flushing {} records.", job.record_count);

        let outcome = match self.queue.flusher.run(job) {
            Ok(outcome) => outcome,
            Err(err) => {
                buffer.restore_storage(Vec::with_capacity(self.queue.settings.initial_capacity));
                return Err(err);
            }
        };
        buffer.restore_storage(outcome.records);
        *self.cell.retained.borrow_mut() = outcome.retained;

        match (pending, outcome.result) {
            (None, Ok(())) => Ok(()),
            (None, Err(err)) => {
                log::warn!("Flush failed: {err}");
                Err(err.into())
            }
            (Some(earlier), result) => {
                if let Err(err) = result {
                    log::warn!("Flush failed: {err}");
                    *self.queue.shared.pending_error.lock() = Some(err);
                }
                Err(earlier.into())
            }
        }
    }
}
