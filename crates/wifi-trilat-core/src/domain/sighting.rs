//! Sighting table: devices currently heard by this node.
//!
//! A bounded arena of one record per address, kept in first-seen order.
//! Lookups are a linear scan; with the default capacity of 50 that is cheaper
//! than hashing and keeps iteration order stable.
//!
//! Records are never removed. A stale record is skipped by [`SightingTable::fresh`]
//! and comes back to life if the same address is heard again. Once the table
//! is full, new addresses are refused until the process restarts.

use std::time::{Duration, Instant};

use super::address::MacAddress;
use super::MAX_CAPACITY;

/// The latest observation of one device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SightingRecord {
    /// The device address.
    pub address: MacAddress,
    /// Most recent signal strength in dBm.
    pub signal: i32,
    /// When the most recent frame was received.
    pub observed_at: Instant,
}

impl SightingRecord {
    /// Whether this record is younger than `timeout` at `now`.
    pub fn is_fresh(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.observed_at) < timeout
    }
}

/// What [`SightingTable::record`] did with a sighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SightingOutcome {
    /// A new record was appended.
    Inserted,
    /// An existing record was overwritten.
    Refreshed,
    /// The address has the group bit set and was ignored.
    Rejected,
    /// The address is new and the table is full.
    TableFull,
}

/// Bounded set of currently observed devices.
#[derive(Debug, Clone)]
pub struct SightingTable {
    records: Vec<SightingRecord>,
    capacity: usize,
}

impl SightingTable {
    /// Default number of tracked devices.
    pub const DEFAULT_CAPACITY: usize = 50;

    /// Create an empty table holding at most `capacity` devices, clamped to
    /// [`MAX_CAPACITY`].
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.min(MAX_CAPACITY);
        Self {
            records: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Record one received frame.
    pub fn record(&mut self, address: MacAddress, signal: i32, now: Instant) -> SightingOutcome {
        if address.is_multicast() {
            return SightingOutcome::Rejected;
        }

        if let Some(rec) = self.records.iter_mut().find(|r| r.address == address) {
            rec.signal = signal;
            rec.observed_at = now;
            return SightingOutcome::Refreshed;
        }

        if self.records.len() >= self.capacity {
            return SightingOutcome::TableFull;
        }

        self.records.push(SightingRecord {
            address,
            signal,
            observed_at: now,
        });
        SightingOutcome::Inserted
    }

    /// Records heard within `timeout` of `now`, in first-seen order.
    ///
    /// The iterator borrows the table, so calling this again yields the
    /// sequence again from the start.
    pub fn fresh(
        &self,
        now: Instant,
        timeout: Duration,
    ) -> impl Iterator<Item = &SightingRecord> + '_ {
        self.records
            .iter()
            .filter(move |r| r.is_fresh(now, timeout))
    }

    /// Look up the record for an address, fresh or not.
    pub fn get(&self, address: &MacAddress) -> Option<&SightingRecord> {
        self.records.iter().find(|r| &r.address == address)
    }

    /// Number of occupied slots, including stale ones.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no device has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Maximum number of devices.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether new addresses will be refused.
    pub fn is_full(&self) -> bool {
        self.records.len() >= self.capacity
    }
}

impl Default for SightingTable {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
