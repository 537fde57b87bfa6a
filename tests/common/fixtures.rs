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

//! Test fixtures for common test scenarios

use std::io::Write;

use tempfile::NamedTempFile;
use vmacmem::core::memory::layout::tags;
use vmacmem::core::memory::{
    BusHandler, DeviceRequest, MapLayout, MemoryMap, MemorySubsystem, NullHandler,
    RangeDescriptor,
};

/// Size of the Mac Plus ROM bank
#[allow(dead_code)]
pub const ROM_SIZE: usize = 0x2_0000;

/// Build a map from a layout and install its table
#[allow(dead_code)]
pub fn create_map(layout: &MapLayout) -> MemoryMap {
    let mut map = MemoryMap::with_banks(layout.build_banks().expect("Failed to build banks"));
    let table = layout
        .build_table(map.banks())
        .expect("Failed to build table");
    map.install(table).expect("Failed to install table");
    map
}

/// Mac Plus memory with the given handler
#[allow(dead_code)]
pub fn create_mac_plus<H: BusHandler>(handler: H) -> MemorySubsystem<H> {
    MemorySubsystem::new(create_map(&MapLayout::mac_plus()), handler)
}

/// Mac Plus memory where devices read as zero and notify declines
#[allow(dead_code)]
pub fn create_plain_mac_plus() -> MemorySubsystem {
    create_mac_plus(NullHandler)
}

/// ROM image whose every word holds its own word index
#[allow(dead_code)]
pub fn create_rom_image() -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    let data: Vec<u8> = (0..ROM_SIZE / 2)
        .flat_map(|i| (i as u16).to_be_bytes())
        .collect();
    file.write_all(&data).expect("Failed to write ROM image");
    file
}

/// Handler modelled on a Mac Plus: VIA register counter, expansion mapped
/// on first touch
#[allow(dead_code)]
pub struct MacPlusDevices {
    pub layout: MapLayout,
    pub via_reads: u32,
    pub scc_writes: Vec<(u32, u32)>,
    pub notifications: u32,
}

#[allow(dead_code)]
impl MacPlusDevices {
    pub fn new() -> Self {
        Self {
            layout: MapLayout::mac_plus(),
            via_reads: 0,
            scc_writes: Vec::new(),
            notifications: 0,
        }
    }
}

impl Default for MacPlusDevices {
    fn default() -> Self {
        Self::new()
    }
}

impl BusHandler for MacPlusDevices {
    fn device_access(&mut self, range: &RangeDescriptor, request: DeviceRequest) -> u32 {
        match (range.tag, request.is_write()) {
            (tags::VIA, false) => {
                self.via_reads += 1;
                self.via_reads
            }
            (tags::SCC, true) => {
                self.scc_writes.push((request.address, request.value));
                0
            }
            _ => 0,
        }
    }

    fn access_notify(&mut self, range: &RangeDescriptor, map: &mut MemoryMap) -> bool {
        self.notifications += 1;
        if range.tag != tags::EXPANSION {
            return false;
        }

        let expansion = map.banks().find("expansion").expect("expansion bank");
        map.banks_mut().bank_mut(expansion).expect("expansion bank")[..4]
            .copy_from_slice(b"EXP!");

        self.layout = self
            .layout
            .expanded("expansion", "expansion", 0x0007_FFFF)
            .expect("expansion notify range");
        let table = self
            .layout
            .build_table(map.banks())
            .expect("Failed to build expanded table");
        map.install(table).is_ok()
    }
}
