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

//! Single-entry translation caches
//!
//! Each access kind (read byte, write byte, read word, write word) keeps a
//! one-slot snapshot of the last cacheable range that served it. A hit
//! costs an AND, a compare and one buffer access; a miss falls back to a
//! full table lookup, which refreshes the snapshot.
//!
//! # Consistency
//!
//! Snapshots are never invalidated individually. They stay correct because
//! only `READ_READY`/`WRITE_READY` ranges are ever cached (device and notify
//! ranges always go through the table) and because installing a new table
//! resets all four slots to a predicate that no address satisfies.
//!
//! The word caches force bit 0 into the compare mask, so an entry filled
//! from an even address can never match an odd one; misaligned words always
//! take the byte path.

use super::banks::BankId;
use super::table::{Backing, RangeDescriptor};

/// Compare state that no address satisfies: `(a & 0) != 0xFFFF_FFFF`
const MISS_MASK: u32 = 0;
const MISS_VALUE: u32 = 0xFFFF_FFFF;

/// One memory address translation cache slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Matc {
    cmp_mask: u32,
    cmp_value: u32,
    backing: Backing,
}

impl Matc {
    /// A slot that misses on every address
    pub const fn empty() -> Self {
        Self {
            cmp_mask: MISS_MASK,
            cmp_value: MISS_VALUE,
            backing: Backing {
                bank: BankId(0),
                base: 0,
                mask: 0,
            },
        }
    }

    /// Snapshot a range for byte access
    #[inline(always)]
    pub(crate) fn fill(&mut self, range: &RangeDescriptor, backing: Backing) {
        self.cmp_mask = range.cmp_mask;
        self.cmp_value = range.cmp_value;
        self.backing = backing;
    }

    /// Snapshot a range for word access; odd addresses never hit afterwards
    #[inline(always)]
    pub(crate) fn fill_aligned(&mut self, range: &RangeDescriptor, backing: Backing) {
        self.fill(range, backing);
        self.cmp_mask |= 0x01;
    }

    /// Validate, then translate
    ///
    /// Returns the backing bank and offset only when the address satisfies
    /// the cached predicate.
    #[inline(always)]
    pub fn translate(&self, addr: u32) -> Option<(BankId, usize)> {
        if (addr & self.cmp_mask) == self.cmp_value {
            Some((self.backing.bank, self.backing.offset(addr)))
        } else {
            None
        }
    }

    /// Whether the slot is in the always-miss state
    pub fn is_empty(&self) -> bool {
        self.cmp_mask == MISS_MASK && self.cmp_value == MISS_VALUE
    }

    pub fn cmp_mask(&self) -> u32 {
        self.cmp_mask
    }

    pub fn cmp_value(&self) -> u32 {
        self.cmp_value
    }
}

impl Default for Matc {
    fn default() -> Self {
        Self::empty()
    }
}

/// The four per-access-kind slots
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatcSet {
    pub read_byte: Matc,
    pub write_byte: Matc,
    pub read_word: Matc,
    pub write_word: Matc,
}

impl MatcSet {
    /// Put every slot back into the always-miss state
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.read_byte.is_empty()
            && self.write_byte.is_empty()
            && self.read_word.is_empty()
            && self.write_word.is_empty()
    }
}
