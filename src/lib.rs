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

//! Memory layer for a 68000 Macintosh emulator
//!
//! Translates every byte, word and long access of the emulated CPU into a
//! host buffer access, a device call or a notify-and-retry, through a
//! move-to-front translation table fronted by four single-entry caches.
//!
//! # Example
//!
//! ```
//! use vmacmem::core::memory::{MapLayout, MemoryMap, MemorySubsystem, NullHandler};
//!
//! let layout = MapLayout::mac_plus();
//! let mut map = MemoryMap::with_banks(layout.build_banks().unwrap());
//! let table = layout.build_table(map.banks()).unwrap();
//! map.install(table).unwrap();
//!
//! let mut memory = MemorySubsystem::new(map, NullHandler);
//! memory.write_long(0x1000, 0x4E71_4E71);
//! assert_eq!(memory.read_word(0x1002), 0x4E71);
//! ```

pub mod core;
