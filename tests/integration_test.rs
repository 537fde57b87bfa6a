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

mod common;

use common::assertions::*;
use common::fixtures::*;
use std::fs;
use tempfile::tempdir;
use vmacmem::core::cpu::{CpuAdapter, CpuBus, M68kCore};
use vmacmem::core::error::Result;
use vmacmem::core::memory::{MapLayout, MemoryMap, MemorySnapshot, MemorySubsystem, NullHandler};

#[test]
fn test_mac_plus_ram_ignores_upper_byte() {
    let mut memory = create_plain_mac_plus();

    memory.write_long(0x0000_1000, 0xCAFE_BABE);
    assert_memory_long(&mut memory, 0x0000_1000, 0xCAFE_BABE);
    assert_memory_long(&mut memory, 0xFF00_1000, 0xCAFE_BABE);
    assert_big_endian(&mut memory, 0x0000_1002);
}

#[test]
fn test_mac_plus_rom_is_mirrored_and_read_only() -> Result<()> {
    let rom_image = create_rom_image();

    let layout = MapLayout::mac_plus();
    let mut map = create_map(&layout);
    let rom = map.banks().find("rom").expect("rom bank");
    map.banks_mut().load_image(rom, rom_image.path())?;
    let mut memory = MemorySubsystem::new(map, NullHandler);

    assert_memory_word(&mut memory, 0x0040_0000, 0x0000);
    assert_memory_word(&mut memory, 0x0040_0010, 0x0008);
    // 128K mirror
    assert_memory_word(&mut memory, 0x0042_0010, 0x0008);

    memory.write_word(0x0040_0010, 0xFFFF);
    assert_memory_word(&mut memory, 0x0040_0010, 0x0008);
    assert_eq!(memory.stats().failed_accesses, 1);
    Ok(())
}

#[test]
fn test_mac_plus_devices() {
    let mut memory = create_mac_plus(MacPlusDevices::new());

    // VIA register free-runs, never cached
    let first = memory.read_byte(0x00EF_E1FE);
    let second = memory.read_byte(0x00EF_E1FE);
    assert_eq!((first, second), (1, 2));

    memory.write_byte(0x00BF_FFFF, 0x5A);
    assert_eq!(memory.handler().scc_writes, vec![(0x00BF_FFFF, 0x5A)]);

    // IWM reads as zero
    assert_eq!(memory.read_word(0x00DF_E1FE), 0);
    assert_eq!(memory.stats().device_accesses, 4);
}

#[test]
fn test_mac_plus_expansion_maps_on_first_touch() {
    let mut memory = create_mac_plus(MacPlusDevices::new());

    assert_memory_long(&mut memory, 0x00F0_0000, u32::from_be_bytes(*b"EXP!"));
    assert_eq!(memory.handler().notifications, 1);

    memory.write_word(0x00F0_0100, 0x1234);
    assert_memory_word(&mut memory, 0x00F0_0100, 0x1234);
    assert_eq!(memory.handler().notifications, 1);

    // RAM still reachable after the rebuild
    memory.write_byte(0x10, 0x99);
    assert_eq!(memory.read_byte(0x10), 0x99);
}

#[test]
fn test_layout_file() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("layout.toml");

    let layout = MapLayout::mac_plus();
    fs::write(&path, layout.to_toml_string().expect("serialise layout"))?;

    let loaded = MapLayout::from_file(&path)?;
    assert_eq!(loaded, layout);

    let mut memory = MemorySubsystem::new(create_map(&loaded), NullHandler);
    memory.write_word(0x2000, 0xABCD);
    assert_memory_word(&mut memory, 0x2000, 0xABCD);
    Ok(())
}

#[test]
fn test_snapshot_round_trip() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("mac.snap");

    let mut memory = create_plain_mac_plus();
    memory.write_long(0x0000_0400, 0x4E71_4E75);
    memory.map().snapshot().save_to_file(&path)?;

    let snapshot = MemorySnapshot::load_from_file(&path)?;
    let mut map: MemoryMap = create_map(&MapLayout::mac_plus());
    map.restore(&snapshot)?;

    let mut restored = MemorySubsystem::new(map, NullHandler);
    assert_memory_long(&mut restored, 0x0000_0400, 0x4E71_4E75);
    Ok(())
}

/// Interprets only NOP (0x4E71), 4 cycles each
struct NopCore {
    pc: u32,
    remaining: i32,
    executed: u32,
}

impl M68kCore for NopCore {
    fn pulse_reset(&mut self, bus: &mut dyn CpuBus) {
        self.pc = bus.read_long(4);
    }

    fn set_irq(&mut self, _level: u8) {}

    fn execute(&mut self, bus: &mut dyn CpuBus, cycles: i32) -> i32 {
        self.remaining = cycles;
        while self.remaining > 0 && bus.read_word(self.pc) == 0x4E71 {
            self.pc = self.pc.wrapping_add(2);
            self.executed += 1;
            self.remaining -= 4;
        }
        cycles - self.remaining.max(0)
    }

    fn cycles_remaining(&self) -> i32 {
        self.remaining
    }

    fn end_timeslice(&mut self) {
        self.remaining = 0;
    }

    fn modify_timeslice(&mut self, cycles: i32) {
        self.remaining += cycles;
    }
}

#[test]
fn test_cpu_runs_from_ram() {
    let mut memory = create_plain_mac_plus();
    memory.write_long(4, 0x0000_2000);
    for i in 0..8 {
        memory.write_word(0x2000 + i * 2, 0x4E71);
    }

    let mut cpu = CpuAdapter::new(NopCore {
        pc: 0,
        remaining: 0,
        executed: 0,
    });
    cpu.reset(&mut memory);
    assert_eq!(cpu.core().pc, 0x2000);

    // 64 host cycles per CPU cycle: 16 CPU cycles = 4 NOPs
    let used = cpu.run_cycles(&mut memory, 16 << 6);
    assert_eq!(used, 16);
    assert_eq!(cpu.core().executed, 4);

    // Stops at the first non-NOP
    cpu.run_cycles(&mut memory, 1 << 12);
    assert_eq!(cpu.core().executed, 8);
    assert_eq!(cpu.core().pc, 0x2010);

    let stats = memory.stats();
    assert!(stats.lookups < 10, "fetches should be served from cache");
}
