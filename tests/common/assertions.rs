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

//! Custom assertions for memory layer testing

use vmacmem::core::memory::{BusHandler, MemorySubsystem};

/// Assert a word read returns the expected value
#[allow(dead_code)]
pub fn assert_memory_word<H: BusHandler>(memory: &mut MemorySubsystem<H>, addr: u32, expected: u16) {
    let actual = memory.read_word(addr);
    assert_eq!(
        actual, expected,
        "Word at 0x{:08X} mismatch: expected 0x{:04X}, got 0x{:04X}",
        addr, expected, actual
    );
}

/// Assert a long read returns the expected value
#[allow(dead_code)]
pub fn assert_memory_long<H: BusHandler>(memory: &mut MemorySubsystem<H>, addr: u32, expected: u32) {
    let actual = memory.read_long(addr);
    assert_eq!(
        actual, expected,
        "Long at 0x{:08X} mismatch: expected 0x{:08X}, got 0x{:08X}",
        addr, expected, actual
    );
}

/// Assert the byte-order law holds at an even address
#[allow(dead_code)]
pub fn assert_big_endian<H: BusHandler>(memory: &mut MemorySubsystem<H>, addr: u32) {
    let hi = memory.read_byte(addr) as u16;
    let lo = memory.read_byte(addr.wrapping_add(1)) as u16;
    assert_memory_word(memory, addr, (hi << 8) | lo);
}
