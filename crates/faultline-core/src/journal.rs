//! # Fault Journal
//!
//! Fixed-capacity, lock-free log of completed dispatches.
//!
//! The dispatcher cannot log while the faulting thread is suspended inside the
//! handler, so it leaves a [`FaultRecord`] here instead. Once the thread has
//! resumed, the host drains the journal and reports through `tracing` or
//! stdout at leisure.
//!
//! ## Protocol
//!
//! - A writer claims a slot with `fetch_add` on `head`, fills it with relaxed
//!   stores and publishes it with a release store of `published`.
//! - Claims beyond [`JOURNAL_CAPACITY`] are counted in `dropped` and otherwise
//!   discarded.
//! - [`FaultJournal::drain`] consumes published slots in claim order and stops
//!   at the first slot still being written. When every claimed slot has been
//!   consumed it rewinds `head` to zero so the journal can be reused.

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, AtomicU8, AtomicUsize, Ordering};

use libc::c_int;

use crate::classify::{classify, Diagnosis};
use crate::types::{Address, FaultKind, FaultMetadata};

/// Number of records the journal holds between drains
pub const JOURNAL_CAPACITY: usize = 64;

/// Outcome of one dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultRecord
{
    /// What the OS reported
    pub metadata: FaultMetadata,
    /// Saved instruction pointer at fault time
    pub instruction_pointer: Address,
    /// Instruction pointer the thread resumed at
    pub resumed_at: Address,
}

impl FaultRecord
{
    /// Re-derive the diagnosis for this record.
    pub fn diagnosis(&self) -> Diagnosis
    {
        classify(&self.metadata)
    }

    /// Bytes skipped by the recovery policy
    pub fn skipped(&self) -> i64
    {
        self.resumed_at.offset_from(self.instruction_pointer)
    }
}

struct JournalSlot
{
    published: AtomicBool,
    kind: AtomicU8,
    signal: AtomicI32,
    has_address: AtomicBool,
    address: AtomicU64,
    cause_code: AtomicI32,
    errno: AtomicI32,
    instruction_pointer: AtomicU64,
    resumed_at: AtomicU64,
}

impl JournalSlot
{
    const EMPTY: JournalSlot = JournalSlot {
        published: AtomicBool::new(false),
        kind: AtomicU8::new(0),
        signal: AtomicI32::new(0),
        has_address: AtomicBool::new(false),
        address: AtomicU64::new(0),
        cause_code: AtomicI32::new(0),
        errno: AtomicI32::new(0),
        instruction_pointer: AtomicU64::new(0),
        resumed_at: AtomicU64::new(0),
    };

    fn store(&self, record: &FaultRecord)
    {
        let metadata = &record.metadata;
        self.kind.store(metadata.kind as u8, Ordering::Relaxed);
        self.signal.store(metadata.signal, Ordering::Relaxed);
        self.has_address
            .store(metadata.faulting_address.is_some(), Ordering::Relaxed);
        self.address.store(
            metadata.faulting_address.map_or(0, Address::value),
            Ordering::Relaxed,
        );
        self.cause_code.store(metadata.cause_code, Ordering::Relaxed);
        self.errno.store(metadata.errno, Ordering::Relaxed);
        self.instruction_pointer
            .store(record.instruction_pointer.value(), Ordering::Relaxed);
        self.resumed_at.store(record.resumed_at.value(), Ordering::Relaxed);
        self.published.store(true, Ordering::Release);
    }

    /// Take the record out of a published slot.
    fn take(&self) -> Option<FaultRecord>
    {
        if !self.published.load(Ordering::Acquire) {
            return None;
        }
        let kind = FaultKind::from_repr(self.kind.load(Ordering::Relaxed))?;
        let faulting_address = self
            .has_address
            .load(Ordering::Relaxed)
            .then(|| Address::new(self.address.load(Ordering::Relaxed)));
        let signal: c_int = self.signal.load(Ordering::Relaxed);
        let record = FaultRecord {
            metadata: FaultMetadata {
                kind,
                signal,
                faulting_address,
                cause_code: self.cause_code.load(Ordering::Relaxed),
                errno: self.errno.load(Ordering::Relaxed),
            },
            instruction_pointer: Address::new(self.instruction_pointer.load(Ordering::Relaxed)),
            resumed_at: Address::new(self.resumed_at.load(Ordering::Relaxed)),
        };
        self.published.store(false, Ordering::Release);
        Some(record)
    }
}

/// Lock-free journal of dispatch outcomes
pub struct FaultJournal
{
    head: AtomicUsize,
    read: AtomicUsize,
    dropped: AtomicU64,
    slots: [JournalSlot; JOURNAL_CAPACITY],
}

impl FaultJournal
{
    /// Empty journal
    pub const fn new() -> Self
    {
        Self {
            head: AtomicUsize::new(0),
            read: AtomicUsize::new(0),
            dropped: AtomicU64::new(0),
            slots: [JournalSlot::EMPTY; JOURNAL_CAPACITY],
        }
    }

    /// Append a record. Async-signal-safe.
    pub fn record(&self, record: &FaultRecord)
    {
        let index = self.head.fetch_add(1, Ordering::AcqRel);
        match self.slots.get(index) {
            Some(slot) => slot.store(record),
            None => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Remove and return every published record, oldest first.
    ///
    /// Meant to be called from normal (non-handler) context by one thread at
    /// a time.
    pub fn drain(&self) -> Vec<FaultRecord>
    {
        let claimed = self.head.load(Ordering::Acquire);
        let end = claimed.min(JOURNAL_CAPACITY);
        let mut cursor = self.read.load(Ordering::Relaxed);
        let mut records = Vec::with_capacity(end.saturating_sub(cursor));

        while cursor < end {
            match self.slots[cursor].take() {
                Some(record) => records.push(record),
                None => break,
            }
            cursor += 1;
        }

        if cursor == end
            && self
                .head
                .compare_exchange(claimed, 0, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        {
            cursor = 0;
        }
        self.read.store(cursor, Ordering::Relaxed);
        records
    }

    /// Number of records lost because the journal was full
    pub fn dropped(&self) -> u64
    {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Number of claimed slots not yet drained
    pub fn pending(&self) -> usize
    {
        self.head
            .load(Ordering::Acquire)
            .min(JOURNAL_CAPACITY)
            .saturating_sub(self.read.load(Ordering::Relaxed))
    }
}

impl Default for FaultJournal
{
    fn default() -> Self
    {
        Self::new()
    }
}

/// Journal the built-in dispatcher records into
pub static JOURNAL: FaultJournal = FaultJournal::new();
