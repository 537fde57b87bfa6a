// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
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

//! Address translation table
//!
//! The table is an ordered, singly-linked list of range descriptors. A
//! logical address `a` belongs to a range iff `(a & cmp_mask) == cmp_value`,
//! so membership is a single AND and compare. The last descriptor is a
//! permanent guard with `cmp_mask == 0`, which matches every address and
//! gives unmapped accesses a deterministic place to land.
//!
//! Descriptors live in an arena and link to each other by [`EntryId`].
//! Lookups reorder the list with a move-to-front policy: a hit on any
//! non-head, non-guard entry splices it out and makes it the new head, so
//! the ranges of the current working set stay one compare away.
//!
//! ```text
//! before lookup(0x00F0_0010):  head -> RAM -> ROM -> EXT -> guard
//! after:                       head -> EXT -> RAM -> ROM -> guard
//! ```

use bitflags::bitflags;
use serde::Serialize;

use super::banks::{BankId, Banks};
use crate::core::error::TableError;

bitflags! {
    /// Access capabilities of a range
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Access: u32 {
        /// Backed by a contiguous buffer, reads may be cached
        const READ_READY = 1 << 0;
        /// Backed by a contiguous buffer, writes may be cached
        const WRITE_READY = 1 << 1;
        /// Every access goes through the device handler
        const DEVICE = 1 << 2;
        /// The notify handler must run first, then the access is retried
        const NOTIFY = 1 << 3;
    }
}

/// Where a cacheable range lives in host memory
///
/// The byte for logical address `a` is `banks[bank][base + (a & mask)]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Backing {
    pub bank: BankId,
    pub base: u32,
    pub mask: u32,
}

impl Backing {
    pub fn new(bank: BankId, base: u32, mask: u32) -> Self {
        Self { bank, base, mask }
    }

    /// Offset into the bank for a logical address
    #[inline(always)]
    pub fn offset(&self, addr: u32) -> usize {
        self.base as usize + (addr & self.mask) as usize
    }

    /// Highest bank offset any byte or word access through this backing can touch
    pub(crate) fn last_offset(&self) -> usize {
        // A word at an even address reads offset and offset + 1. When mask
        // bit 0 is set, offset + 1 is still within base + mask.
        self.base as usize + self.mask as usize + usize::from(self.mask & 1 == 0)
    }
}

/// Handle to a descriptor inside an [`AddressTable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(usize);

impl EntryId {
    /// Index of the descriptor in the arena (insertion order, not list order)
    pub fn index(self) -> usize {
        self.0
    }
}

/// One entry of the translation table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeDescriptor {
    pub cmp_mask: u32,
    pub cmp_value: u32,
    pub access: Access,
    /// Physical location, required for `READ_READY`/`WRITE_READY` ranges
    pub backing: Option<Backing>,
    /// Opaque id the memory-map owner uses to tell its devices and notify
    /// sources apart
    pub tag: u32,
    next: Option<EntryId>,
}

impl RangeDescriptor {
    /// Create a descriptor with no backing and tag 0
    pub fn new(cmp_mask: u32, cmp_value: u32, access: Access) -> Self {
        Self {
            cmp_mask,
            cmp_value,
            access,
            backing: None,
            tag: 0,
            next: None,
        }
    }

    /// A range backed by a host buffer
    ///
    /// # Example
    ///
    /// ```
    /// use vmacmem::core::memory::{Access, Backing, Banks, RangeDescriptor};
    ///
    /// let mut banks = Banks::new();
    /// let ram = banks.add("ram", 0x10_0000);
    /// let range = RangeDescriptor::memory(
    ///     0xFFF0_0000,
    ///     0x0000_0000,
    ///     Access::READ_READY | Access::WRITE_READY,
    ///     Backing::new(ram, 0, 0x000F_FFFF),
    /// );
    /// assert!(range.matches(0x0000_1234));
    /// assert!(!range.matches(0x0010_0000));
    /// ```
    pub fn memory(cmp_mask: u32, cmp_value: u32, access: Access, backing: Backing) -> Self {
        Self::new(cmp_mask, cmp_value, access).with_backing(backing)
    }

    /// A memory-mapped device window
    pub fn device(cmp_mask: u32, cmp_value: u32, tag: u32) -> Self {
        Self::new(cmp_mask, cmp_value, Access::DEVICE).with_tag(tag)
    }

    /// A provisional range whose first touch runs the notify handler
    pub fn notify(cmp_mask: u32, cmp_value: u32, tag: u32) -> Self {
        Self::new(cmp_mask, cmp_value, Access::NOTIFY).with_tag(tag)
    }

    /// The catch-all guard: matches everything, grants nothing
    pub fn guard() -> Self {
        Self::new(0, 0, Access::empty())
    }

    pub fn with_backing(mut self, backing: Backing) -> Self {
        self.backing = Some(backing);
        self
    }

    pub fn with_tag(mut self, tag: u32) -> Self {
        self.tag = tag;
        self
    }

    /// Membership test
    #[inline(always)]
    pub fn matches(&self, addr: u32) -> bool {
        (addr & self.cmp_mask) == self.cmp_value
    }

    /// Whether this entry terminates its table
    pub fn is_last(&self) -> bool {
        self.next.is_none()
    }

    fn is_cacheable(&self) -> bool {
        self.access
            .intersects(Access::READ_READY | Access::WRITE_READY)
    }
}

/// Lookup counters, slow path only
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TableStats {
    /// Full lookups performed
    pub lookups: u64,
    /// Descriptors compared beyond the head
    pub probes: u64,
    /// Entries moved to the front
    pub promotions: u64,
}

/// Guard-terminated translation table
#[derive(Debug, Clone)]
pub struct AddressTable {
    entries: Vec<RangeDescriptor>,
    head: EntryId,
    stats: TableStats,
}

impl AddressTable {
    /// A table holding only the default guard
    pub fn guard_only() -> Self {
        Self {
            entries: vec![RangeDescriptor::guard()],
            head: EntryId(0),
            stats: TableStats::default(),
        }
    }

    /// Entry currently at the front of the list
    pub fn head(&self) -> EntryId {
        self.head
    }

    /// Number of descriptors, guard included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false: a built table holds at least the guard
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Descriptor behind a handle
    pub fn entry(&self, id: EntryId) -> &RangeDescriptor {
        &self.entries[id.0]
    }

    /// Walk the list from head to guard
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            table: self,
            cursor: Some(self.head),
        }
    }

    /// Handles in current list order
    pub fn order(&self) -> Vec<EntryId> {
        self.iter().map(|(id, _)| id).collect()
    }

    pub fn stats(&self) -> TableStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = TableStats::default();
    }

    /// Resolve an address to its owning descriptor
    ///
    /// A head hit returns without touching the list. Otherwise the list is
    /// walked with a trailing predecessor; a match that is not the guard is
    /// moved to the front. The guard is never promoted, so more specific
    /// ranges are always examined before it.
    ///
    /// # Example
    ///
    /// ```
    /// use vmacmem::core::memory::{Access, RangeDescriptor, TableBuilder};
    ///
    /// let mut table = TableBuilder::new()
    ///     .range(RangeDescriptor::device(0xFFFF_0000, 0x0001_0000, 1))
    ///     .range(RangeDescriptor::device(0xFFFF_0000, 0x0002_0000, 2))
    ///     .build()
    ///     .unwrap();
    ///
    /// let id = table.find(0x0002_0010);
    /// assert_eq!(table.entry(id).tag, 2);
    /// assert_eq!(table.head(), id);
    /// ```
    pub fn find(&mut self, addr: u32) -> EntryId {
        self.stats.lookups += 1;

        let head = self.head;
        if self.entries[head.0].matches(addr) {
            return head;
        }

        let mut prev = head;
        let mut depth = 0usize;
        while let Some(id) = self.entries[prev.0].next {
            self.stats.probes += 1;
            depth += 1;

            let entry = self.entries[id.0];
            if entry.matches(addr) {
                if entry.next.is_some() {
                    self.entries[prev.0].next = entry.next;
                    self.entries[id.0].next = Some(self.head);
                    self.head = id;
                    self.stats.promotions += 1;
                    log::debug!(
                        "Promoted range 0x{:08X}/0x{:08X} from depth {} (0x{:08X})",
                        entry.cmp_mask,
                        entry.cmp_value,
                        depth,
                        addr
                    );
                }
                return id;
            }
            prev = id;
        }

        // Unreachable for a built table: the guard matches every address.
        prev
    }

    /// Check every cacheable range against the banks it points into
    pub fn validate(&self, banks: &Banks) -> Result<(), TableError> {
        for (index, entry) in self.entries.iter().enumerate() {
            if !entry.is_cacheable() {
                continue;
            }

            let backing = entry
                .backing
                .ok_or(TableError::MissingBacking { index })?;
            let len = banks
                .len_of(backing.bank)
                .ok_or(TableError::UnknownBank {
                    index,
                    bank: backing.bank.index(),
                })?;

            let end = backing.last_offset();
            if end >= len {
                return Err(TableError::BackingOutOfBounds {
                    index,
                    bank: backing.bank.index(),
                    end,
                    len,
                });
            }
        }
        Ok(())
    }
}

/// List-order iterator over a table
pub struct Iter<'a> {
    table: &'a AddressTable,
    cursor: Option<EntryId>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (EntryId, &'a RangeDescriptor);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let entry = &self.table.entries[id.0];
        self.cursor = entry.next;
        Some((id, entry))
    }
}

/// Builds a table in list order and terminates it with a guard
///
/// # Example
///
/// ```
/// use vmacmem::core::memory::{RangeDescriptor, TableBuilder};
///
/// let table = TableBuilder::new()
///     .range(RangeDescriptor::device(0x00F0_0000, 0x00E0_0000, 7))
///     .build()
///     .unwrap();
///
/// assert_eq!(table.len(), 2);
/// let (_, last) = table.iter().last().unwrap();
/// assert!(last.is_last());
/// assert_eq!(last.cmp_mask, 0);
/// ```
#[derive(Debug, Default)]
pub struct TableBuilder {
    ranges: Vec<RangeDescriptor>,
    guard: Option<RangeDescriptor>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a range after the ones already added
    pub fn range(mut self, range: RangeDescriptor) -> Self {
        self.ranges.push(range);
        self
    }

    /// Replace the default guard, e.g. to route unmapped accesses to a device
    ///
    /// The guard matches every address, so it may not be `READ_READY` or
    /// `WRITE_READY`: a cache filled from it would hit for every address.
    pub fn guard(mut self, guard: RangeDescriptor) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn build(self) -> Result<AddressTable, TableError> {
        let guard = self.guard.unwrap_or_else(RangeDescriptor::guard);
        if guard.cmp_mask != 0 || guard.cmp_value != 0 {
            return Err(TableError::InvalidGuard {
                mask: guard.cmp_mask,
                value: guard.cmp_value,
            });
        }
        if guard.is_cacheable() {
            return Err(TableError::CacheableGuard);
        }

        let mut entries = self.ranges;
        entries.push(guard);

        let count = entries.len();
        for (index, entry) in entries.iter_mut().enumerate() {
            if entry.is_cacheable() && entry.backing.is_none() {
                return Err(TableError::MissingBacking { index });
            }
            entry.next = if index + 1 < count {
                Some(EntryId(index + 1))
            } else {
                None
            };
        }

        Ok(AddressTable {
            entries,
            head: EntryId(0),
            stats: TableStats::default(),
        })
    }
}
