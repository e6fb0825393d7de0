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

//! The growable byte buffer records are encoded into.

use crate::record::Opcode;
use strata_core::NativeHandle;

/// One flush cycle's worth of encoded records.
///
/// Every value is written little-endian. Writers must be preceded by
/// [`CommandBuffer::ensure_capacity`] (or its aligned variant) covering the
/// bytes about to be written; writing past the reservation is a caller bug
/// and panics. The buffer only ever grows; flushing resets the cursor but
/// keeps the backing storage.
#[derive(Debug)]
pub struct CommandBuffer {
    data: Vec<u8>,
    reserved: usize,
    records: usize,
}

impl CommandBuffer {
    /// Creates a buffer with `capacity` bytes of backing storage.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            reserved: 0,
            records: 0,
        }
    }

    /// Guarantees that the next `bytes` bytes can be written, growing the
    /// storage geometrically if needed.
    pub fn ensure_capacity(&mut self, bytes: usize) {
        self.data.reserve(bytes);
        self.reserved = bytes;
    }

    /// Reserves `bytes` bytes for a record whose first 8-byte field sits
    /// `first_long_offset` bytes after its start, inserting a `NOOP` record
    /// first if that field would otherwise not be 8-byte aligned.
    pub fn ensure_capacity_and_alignment(&mut self, bytes: usize, first_long_offset: usize) {
        self.ensure_capacity(bytes + 4);
        if (self.data.len() + first_long_offset) % 8 != 0 {
            self.put_int(Opcode::Noop as i32);
        }
        self.reserved = bytes;
    }

    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        assert!(
            bytes.len() <= self.reserved,
            "command buffer write of {} bytes without reserved capacity ({} left)",
            bytes.len(),
            self.reserved
        );
        self.reserved -= bytes.len();
        self.data.extend_from_slice(bytes);
    }

    /// Starts a record by writing its opcode.
    pub fn put_opcode(&mut self, opcode: Opcode) -> &mut Self {
        self.put_int(opcode as i32);
        if opcode != Opcode::Noop {
            self.records += 1;
        }
        self
    }

    /// Appends an `i32`.
    pub fn put_int(&mut self, v: i32) -> &mut Self {
        self.write(&v.to_le_bytes());
        self
    }

    /// Appends an `i64`.
    pub fn put_long(&mut self, v: i64) -> &mut Self {
        self.write(&v.to_le_bytes());
        self
    }

    /// Appends an `f32`.
    pub fn put_float(&mut self, v: f32) -> &mut Self {
        self.write(&v.to_le_bytes());
        self
    }

    /// Appends an `f64`.
    pub fn put_double(&mut self, v: f64) -> &mut Self {
        self.write(&v.to_le_bytes());
        self
    }

    /// Appends a native handle as a 64-bit value.
    pub fn put_handle(&mut self, handle: NativeHandle) -> &mut Self {
        self.write(&handle.0.to_le_bytes());
        self
    }

    /// The write cursor: bytes written since the last clear.
    #[inline]
    pub fn position(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if nothing was written since the last clear.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Records started since the last clear, padding excluded.
    #[inline]
    pub fn record_count(&self) -> usize {
        self.records
    }

    /// The bytes written since the last clear.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Size of the backing storage in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Returns the filled length and resets the cursor to zero without
    /// releasing storage.
    pub fn position_and_clear(&mut self) -> usize {
        let len = self.data.len();
        self.data.clear();
        self.reserved = 0;
        self.records = 0;
        len
    }

    /// Moves the backing storage out so another thread can read it. The
    /// buffer is unusable until [`CommandBuffer::restore_storage`] hands it back.
    pub(crate) fn take_storage(&mut self) -> Vec<u8> {
        self.reserved = 0;
        std::mem::take(&mut self.data)
    }

    /// Puts storage returned by the flusher back, cleared.
    pub(crate) fn restore_storage(&mut self, mut storage: Vec<u8>) {
        storage.clear();
        self.data = storage;
        self.reserved = 0;
        self.records = 0;
    }
}
