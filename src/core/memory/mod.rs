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

//! Memory subsystem for the 68000 emulator
//!
//! Every byte, word and long the interpreter touches goes through
//! [`MemorySubsystem`]. It maps a 32-bit logical address to one of:
//!
//! | Range kind | Capability             | Served by                           |
//! |------------|------------------------|-------------------------------------|
//! | Memory     | `READ_READY`/`WRITE_READY` | host buffer in [`Banks`], cached |
//! | Device     | `DEVICE`               | [`BusHandler::device_access`], every time |
//! | Notify     | `NOTIFY`               | [`BusHandler::access_notify`], then retry |
//! | Guard      | none                   | silent failure (read 0, write dropped) |
//!
//! # Access path
//!
//! 1. Check the single-entry cache for the access kind. On a hit, index the
//!    bank directly.
//! 2. On a miss, look the address up in the [`AddressTable`] (moving the hit
//!    to the front), then dispatch on the range's capabilities.
//! 3. A memory range refreshes the cache; device and notify ranges never do.
//!
//! Words at odd addresses are two byte accesses. Longs are two word
//! accesses at `a` and `a + 2`, composed big-endian.
//!
//! # Example
//!
//! ```
//! use vmacmem::core::memory::{
//!     Access, Backing, MemoryMap, MemorySubsystem, NullHandler, RangeDescriptor, TableBuilder,
//! };
//!
//! let mut map = MemoryMap::new();
//! let ram = map.add_bank("ram", 0x10_0000);
//! let table = TableBuilder::new()
//!     .range(RangeDescriptor::memory(
//!         0xFFF0_0000,
//!         0x0000_0000,
//!         Access::READ_READY | Access::WRITE_READY,
//!         Backing::new(ram, 0, 0x000F_FFFF),
//!     ))
//!     .build()
//!     .unwrap();
//! map.install(table).unwrap();
//!
//! let mut memory = MemorySubsystem::new(map, NullHandler);
//! memory.write_long(0x100, 0x1234_5678);
//! assert_eq!(memory.read_word(0x100), 0x1234);
//! assert_eq!(memory.read_byte(0x103), 0x78);
//!
//! // Outside RAM: falls through to the guard
//! assert_eq!(memory.read_byte(0x50_0000), 0);
//! ```

use serde::Serialize;

use crate::core::error::Result;

mod banks;
mod cache;
mod handler;
pub mod layout;
pub mod snapshot;
mod table;

pub use banks::{BankId, Banks};
pub use cache::{Matc, MatcSet};
pub use handler::{BusHandler, DeviceRequest, Direction, NullHandler, Width};
pub use layout::MapLayout;
pub use snapshot::MemorySnapshot;
pub use table::{Access, AddressTable, Backing, EntryId, RangeDescriptor, TableBuilder, TableStats};

/// The translation state a memory-map owner manipulates
///
/// Holds the installed table (the list head lives inside it), the four
/// single-entry caches and the backing banks. Installing a table is the
/// "rebuild" operation: it must follow every structural change and it resets
/// all caches.
pub struct MemoryMap {
    table: AddressTable,
    caches: MatcSet,
    banks: Banks,
    /// Lookup counters carried over from previously installed tables
    retired: TableStats,
}

impl MemoryMap {
    /// Empty map: no banks, a table holding only the guard
    pub fn new() -> Self {
        Self::with_banks(Banks::new())
    }

    /// Map over existing banks, with a guard-only table
    pub fn with_banks(banks: Banks) -> Self {
        Self {
            table: AddressTable::guard_only(),
            caches: MatcSet::default(),
            banks,
            retired: TableStats::default(),
        }
    }

    /// Install a new table and reset all caches
    ///
    /// The table is checked against the banks first; on error the previous
    /// table stays installed and the caches are untouched.
    ///
    /// # Errors
    ///
    /// Returns `EmulatorError::Table` if a cacheable range has no backing,
    /// names an unknown bank, or can reach past the end of its bank.
    pub fn install(&mut self, table: AddressTable) -> Result<()> {
        table.validate(&self.banks)?;

        let old = std::mem::replace(&mut self.table, table);
        let old_stats = old.stats();
        self.retired.lookups += old_stats.lookups;
        self.retired.probes += old_stats.probes;
        self.retired.promotions += old_stats.promotions;

        self.caches.reset();
        log::debug!("Installed translation table ({} ranges)", self.table.len());
        Ok(())
    }

    /// Resolve an address through the table, reordering it
    pub fn find(&mut self, addr: u32) -> RangeDescriptor {
        let id = self.table.find(addr);
        *self.table.entry(id)
    }

    pub fn table(&self) -> &AddressTable {
        &self.table
    }

    pub fn caches(&self) -> &MatcSet {
        &self.caches
    }

    pub fn banks(&self) -> &Banks {
        &self.banks
    }

    /// Mutable bank access; contents may change, sizes may not
    pub fn banks_mut(&mut self) -> &mut Banks {
        &mut self.banks
    }

    /// Allocate a zero-filled bank
    pub fn add_bank(&mut self, name: &str, size: usize) -> BankId {
        self.banks.add(name, size)
    }

    /// Lookup counters across every table this map has held
    pub fn table_stats(&self) -> TableStats {
        let current = self.table.stats();
        TableStats {
            lookups: self.retired.lookups + current.lookups,
            probes: self.retired.probes + current.probes,
            promotions: self.retired.promotions + current.promotions,
        }
    }

    fn reset_stats(&mut self) {
        self.retired = TableStats::default();
        self.table.reset_stats();
    }
}

impl Default for MemoryMap {
    fn default() -> Self {
        Self::new()
    }
}

/// Dispatch counters, slow path only
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct DispatchStats {
    device_accesses: u64,
    notifications: u64,
    rejected_notifications: u64,
    failed_accesses: u64,
}

/// Slow-path counters for the whole subsystem
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AccessStats {
    /// Table lookups (cache misses, odd-word and device accesses included)
    pub lookups: u64,
    /// Descriptors compared past the list head
    pub probes: u64,
    /// Move-to-front promotions
    pub promotions: u64,
    /// Calls into the device handler
    pub device_accesses: u64,
    /// Calls into the notify handler
    pub notifications: u64,
    /// Notify calls that declined to remap
    pub rejected_notifications: u64,
    /// Accesses that failed silently (guard or rejected notify)
    pub failed_accesses: u64,
}

/// Outcome of a slow-path lookup for one direction
enum Resolved {
    Memory(RangeDescriptor, Backing),
    Device(RangeDescriptor),
    Failed,
}

/// The accessors the CPU core calls, plus the handler for non-memory ranges
///
/// Single-threaded and non-reentrant: each call completes, including any
/// notify-and-retry, before the next begins.
pub struct MemorySubsystem<H: BusHandler = NullHandler> {
    map: MemoryMap,
    handler: H,
    dispatch: DispatchStats,
}

impl<H: BusHandler> MemorySubsystem<H> {
    pub fn new(map: MemoryMap, handler: H) -> Self {
        log::debug!("Memory subsystem created with handler '{}'", handler.name());
        Self {
            map,
            handler,
            dispatch: DispatchStats::default(),
        }
    }

    pub fn map(&self) -> &MemoryMap {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut MemoryMap {
        &mut self.map
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Rebuild: install a new table and reset the caches
    pub fn install_table(&mut self, table: AddressTable) -> Result<()> {
        self.map.install(table)
    }

    pub fn stats(&self) -> AccessStats {
        let table = self.map.table_stats();
        AccessStats {
            lookups: table.lookups,
            probes: table.probes,
            promotions: table.promotions,
            device_accesses: self.dispatch.device_accesses,
            notifications: self.dispatch.notifications,
            rejected_notifications: self.dispatch.rejected_notifications,
            failed_accesses: self.dispatch.failed_accesses,
        }
    }

    pub fn reset_stats(&mut self) {
        self.map.reset_stats();
        self.dispatch = DispatchStats::default();
    }

    /// Read a byte
    #[inline]
    pub fn read_byte(&mut self, addr: u32) -> u8 {
        match self.map.caches.read_byte.translate(addr) {
            Some((bank, offset)) => self.map.banks.read_u8(bank, offset),
            None => self.read_byte_slow(addr),
        }
    }

    /// Write a byte
    #[inline]
    pub fn write_byte(&mut self, addr: u32, value: u8) {
        match self.map.caches.write_byte.translate(addr) {
            Some((bank, offset)) => self.map.banks.write_u8(bank, offset, value),
            None => self.write_byte_slow(addr, value),
        }
    }

    /// Read a big-endian word
    ///
    /// Odd addresses are composed from two byte reads.
    #[inline]
    pub fn read_word(&mut self, addr: u32) -> u16 {
        match self.map.caches.read_word.translate(addr) {
            Some((bank, offset)) => self.map.banks.read_u16(bank, offset),
            None => self.read_word_slow(addr),
        }
    }

    /// Write a big-endian word
    #[inline]
    pub fn write_word(&mut self, addr: u32, value: u16) {
        match self.map.caches.write_word.translate(addr) {
            Some((bank, offset)) => self.map.banks.write_u16(bank, offset, value),
            None => self.write_word_slow(addr, value),
        }
    }

    /// Read a big-endian long as words at `addr` and `addr + 2`
    ///
    /// When both halves hit the read-word cache they are served directly;
    /// otherwise each half goes through the full word path, so the halves
    /// may resolve to different ranges.
    #[inline]
    pub fn read_long(&mut self, addr: u32) -> u32 {
        let addr2 = addr.wrapping_add(2);
        let cache = &self.map.caches.read_word;

        if let (Some((bank, offset)), Some((bank2, offset2))) =
            (cache.translate(addr), cache.translate(addr2))
        {
            let hi = self.map.banks.read_u16(bank, offset) as u32;
            let lo = self.map.banks.read_u16(bank2, offset2) as u32;
            return (hi << 16) | lo;
        }

        let hi = self.read_word(addr) as u32;
        let lo = self.read_word(addr2) as u32;
        (hi << 16) | lo
    }

    /// Write a big-endian long as words at `addr` and `addr + 2`
    #[inline]
    pub fn write_long(&mut self, addr: u32, value: u32) {
        let addr2 = addr.wrapping_add(2);
        let hi = (value >> 16) as u16;
        let lo = value as u16;
        let cache = &self.map.caches.write_word;

        if let (Some((bank, offset)), Some((bank2, offset2))) =
            (cache.translate(addr), cache.translate(addr2))
        {
            self.map.banks.write_u16(bank, offset, hi);
            self.map.banks.write_u16(bank2, offset2, lo);
            return;
        }

        self.write_word(addr, hi);
        self.write_word(addr2, lo);
    }

    #[inline(never)]
    fn read_byte_slow(&mut self, addr: u32) -> u8 {
        match self.resolve(addr, Direction::Read) {
            Resolved::Memory(range, backing) => {
                self.map.caches.read_byte.fill(&range, backing);
                self.map.banks.read_u8(backing.bank, backing.offset(addr))
            }
            Resolved::Device(range) => {
                let request = DeviceRequest::read(Width::Byte, addr);
                self.handler.device_access(&range, request) as u8
            }
            Resolved::Failed => 0,
        }
    }

    #[inline(never)]
    fn write_byte_slow(&mut self, addr: u32, value: u8) {
        match self.resolve(addr, Direction::Write) {
            Resolved::Memory(range, backing) => {
                self.map.caches.write_byte.fill(&range, backing);
                self.map
                    .banks
                    .write_u8(backing.bank, backing.offset(addr), value);
            }
            Resolved::Device(range) => {
                let request = DeviceRequest::write(Width::Byte, addr, value as u32);
                self.handler.device_access(&range, request);
            }
            Resolved::Failed => {}
        }
    }

    #[inline(never)]
    fn read_word_slow(&mut self, addr: u32) -> u16 {
        if addr & 0x01 != 0 {
            let hi = self.read_byte(addr);
            let lo = self.read_byte(addr.wrapping_add(1));
            return u16::from_be_bytes([hi, lo]);
        }

        match self.resolve(addr, Direction::Read) {
            Resolved::Memory(range, backing) => {
                self.map.caches.read_word.fill_aligned(&range, backing);
                self.map.banks.read_u16(backing.bank, backing.offset(addr))
            }
            Resolved::Device(range) => {
                let request = DeviceRequest::read(Width::Word, addr);
                self.handler.device_access(&range, request) as u16
            }
            Resolved::Failed => 0,
        }
    }

    #[inline(never)]
    fn write_word_slow(&mut self, addr: u32, value: u16) {
        if addr & 0x01 != 0 {
            let [hi, lo] = value.to_be_bytes();
            self.write_byte(addr, hi);
            self.write_byte(addr.wrapping_add(1), lo);
            return;
        }

        match self.resolve(addr, Direction::Write) {
            Resolved::Memory(range, backing) => {
                self.map.caches.write_word.fill_aligned(&range, backing);
                self.map
                    .banks
                    .write_u16(backing.bank, backing.offset(addr), value);
            }
            Resolved::Device(range) => {
                let request = DeviceRequest::write(Width::Word, addr, value as u32);
                self.handler.device_access(&range, request);
            }
            Resolved::Failed => {}
        }
    }

    /// Look the address up and pick how to serve it
    ///
    /// Precedence is ready flag, then device, then notify. A notify that
    /// succeeds restarts the lookup because the table may have changed.
    fn resolve(&mut self, addr: u32, direction: Direction) -> Resolved {
        let ready = match direction {
            Direction::Read => Access::READ_READY,
            Direction::Write => Access::WRITE_READY,
        };

        loop {
            let range = self.map.find(addr);

            if let (true, Some(backing)) = (range.access.contains(ready), range.backing) {
                return Resolved::Memory(range, backing);
            }

            if range.access.contains(Access::DEVICE) {
                self.dispatch.device_accesses += 1;
                return Resolved::Device(range);
            }

            if range.access.contains(Access::NOTIFY) {
                self.dispatch.notifications += 1;
                if self.handler.access_notify(&range, &mut self.map) {
                    continue;
                }
                self.dispatch.rejected_notifications += 1;
                log::trace!(
                    "Notify (tag {}) declined for {:?} at 0x{:08X}",
                    range.tag,
                    direction,
                    addr
                );
            } else {
                log::trace!("Unmapped {:?} at 0x{:08X}", direction, addr);
            }

            self.dispatch.failed_accesses += 1;
            return Resolved::Failed;
        }
    }
}

#[cfg(test)]
mod tests;
