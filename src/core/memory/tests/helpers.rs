// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut

//! Helper functions for memory tests

use super::*;

pub const RAM_MASK: u32 = 0xFFF0_0000;
pub const RAM_SIZE: usize = 0x10_0000;

/// Read/write range over a whole bank
pub fn ram_range(bank: BankId, cmp_mask: u32, cmp_value: u32, use_mask: u32) -> RangeDescriptor {
    RangeDescriptor::memory(
        cmp_mask,
        cmp_value,
        Access::READ_READY | Access::WRITE_READY,
        Backing::new(bank, 0, use_mask),
    )
}

/// 1MB of RAM at 0x000000, everything else falls to the guard
pub fn create_ram_map() -> (MemoryMap, BankId) {
    let mut map = MemoryMap::new();
    let ram = map.add_bank("ram", RAM_SIZE);
    let table = TableBuilder::new()
        .range(ram_range(ram, RAM_MASK, 0x0000_0000, 0x000F_FFFF))
        .build()
        .unwrap();
    map.install(table).unwrap();
    (map, ram)
}

/// Subsystem over [`create_ram_map`] with no device handler
pub fn create_ram_subsystem() -> MemorySubsystem {
    let (map, _) = create_ram_map();
    MemorySubsystem::new(map, NullHandler)
}

/// Two adjacent 1MB RAM windows backed by different banks
///
/// `low` covers 0x000000-0x0FFFFF, `high` covers 0x100000-0x1FFFFF.
#[allow(dead_code)]
pub fn create_split_map() -> (MemoryMap, BankId, BankId) {
    let mut map = MemoryMap::new();
    let low = map.add_bank("low", RAM_SIZE);
    let high = map.add_bank("high", RAM_SIZE);
    let table = TableBuilder::new()
        .range(ram_range(low, RAM_MASK, 0x0000_0000, 0x000F_FFFF))
        .range(ram_range(high, RAM_MASK, 0x0010_0000, 0x000F_FFFF))
        .build()
        .unwrap();
    map.install(table).unwrap();
    (map, low, high)
}

/// Table of `count` small device windows at 0x10000 * (i + 1), tagged `i`
#[allow(dead_code)]
pub fn create_device_table(count: u32) -> AddressTable {
    (0..count)
        .fold(TableBuilder::new(), |builder, i| {
            builder.range(RangeDescriptor::device(
                0xFFFF_0000,
                0x0001_0000 * (i + 1),
                i,
            ))
        })
        .build()
        .unwrap()
}

/// Tags in current list order, guard excluded
#[allow(dead_code)]
pub fn tag_order(table: &AddressTable) -> Vec<u32> {
    table
        .iter()
        .filter(|(_, range)| !range.is_last())
        .map(|(_, range)| range.tag)
        .collect()
}
