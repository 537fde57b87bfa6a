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

use std::path::PathBuf;

use clap::Parser;
use log::{error, info, warn};
use vmacmem::core::error::LayoutError;
use vmacmem::core::memory::layout::tags;
use vmacmem::core::memory::{
    BusHandler, DeviceRequest, MapLayout, MemoryMap, MemorySubsystem, RangeDescriptor,
};

/// Memory layer exerciser for a 68000 Macintosh emulator
#[derive(Parser)]
#[command(name = "vmacmem")]
#[command(about = "Runs a synthetic access trace through the memory layer", long_about = None)]
struct Args {
    /// Memory layout file (TOML); defaults to the built-in Mac Plus map
    #[arg(short = 'l', long)]
    layout: Option<PathBuf>,

    /// ROM image copied into the bank named "rom"
    #[arg(short = 'r', long)]
    rom: Option<PathBuf>,

    /// Number of trace iterations
    #[arg(short = 'n', long, default_value = "100000")]
    accesses: usize,

    /// Print final statistics as JSON
    #[arg(long)]
    json: bool,

    /// Write a bank snapshot here after the run
    #[arg(short = 's', long)]
    snapshot: Option<PathBuf>,
}

/// Devices and media for the demo machine
///
/// The VIA window is a free-running timer register; every other device
/// reads as zero. The expansion window is mapped onto its bank on first
/// touch.
struct DemoMachine {
    layout: MapLayout,
    timer: u16,
}

impl DemoMachine {
    fn new(layout: MapLayout) -> Self {
        Self { layout, timer: 0 }
    }
}

impl BusHandler for DemoMachine {
    fn device_access(&mut self, range: &RangeDescriptor, request: DeviceRequest) -> u32 {
        match range.tag {
            tags::VIA if !request.is_write() => {
                self.timer = self.timer.wrapping_add(1);
                self.timer as u32
            }
            tags::VIA => 0,
            tag => {
                log::trace!("Device {} access at 0x{:08X}", tag, request.address);
                0
            }
        }
    }

    fn access_notify(&mut self, range: &RangeDescriptor, map: &mut MemoryMap) -> bool {
        if range.tag != tags::EXPANSION {
            return false;
        }

        let Some(layout) = self.layout.expanded("expansion", "expansion", 0x0007_FFFF) else {
            warn!("No unmapped expansion range in layout, refusing access");
            return false;
        };
        match layout
            .build_table(map.banks())
            .and_then(|table| map.install(table))
        {
            Ok(()) => {
                info!("Expansion window mapped");
                self.layout = layout;
                true
            }
            Err(e) => {
                warn!("Cannot map expansion window: {}", e);
                false
            }
        }
    }

    fn name(&self) -> &str {
        "DemoMachine"
    }
}

/// Small deterministic generator so traces are reproducible
struct Lcg(u32);

impl Lcg {
    fn next_u32(&mut self) -> u32 {
        self.0 = self.0.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        self.0
    }
}

/// Mix of instruction fetches, stack and heap traffic, device polls and
/// expansion accesses
fn run_trace<H: BusHandler>(memory: &mut MemorySubsystem<H>, iterations: usize) {
    let mut rng = Lcg(0x1234_5678);
    let mut pc: u32 = 0x0040_0000;
    let mut sp: u32 = 0x0000_8000;
    let log_interval = (iterations / 10).max(1);

    for i in 0..iterations {
        if i % log_interval == 0 && i > 0 {
            let stats = memory.stats();
            info!(
                "Progress: {}/{} | lookups: {} | probes: {}",
                i, iterations, stats.lookups, stats.probes
            );
        }

        // Fetch
        memory.read_word(pc);
        pc = 0x0040_0000 | (pc.wrapping_add(2) & 0x0001_FFFE);

        let r = rng.next_u32();
        match r % 16 {
            0..=5 => {
                sp = 0x0000_7000 | (sp.wrapping_sub(4) & 0x0FFC);
                memory.write_long(sp, r);
            }
            6..=9 => {
                memory.read_long(sp);
            }
            10..=12 => {
                let addr = (r >> 8) & 0x003F_FFFF;
                memory.write_byte(addr, r as u8);
                memory.read_word(addr);
            }
            13 => {
                memory.read_byte(0x00EF_E1FE);
            }
            14 => {
                memory.read_word(0x00F0_0000 | ((r >> 12) & 0x0007_FFFE));
            }
            _ => {
                memory.write_byte(0x00BF_FFFF, r as u8);
            }
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.to_string().contains("not found") {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("vmacmem v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();

    let layout = match &args.layout {
        Some(path) => {
            info!("Loading layout from: {}", path.display());
            MapLayout::from_file(path)?
        }
        None => {
            info!("Using built-in Mac Plus layout");
            MapLayout::mac_plus()
        }
    };

    let mut map = MemoryMap::with_banks(layout.build_banks()?);

    if let Some(rom_path) = &args.rom {
        let rom = map
            .banks()
            .find("rom")
            .ok_or_else(|| LayoutError::UnknownBank("rom".to_string()))?;
        if let Err(e) = map.banks_mut().load_image(rom, rom_path) {
            error!("Failed to load ROM: {}", e);
            return Err(e.into());
        }
    }

    let table = layout.build_table(map.banks())?;
    map.install(table)?;

    let mut memory = MemorySubsystem::new(map, DemoMachine::new(layout));

    info!("Running {} trace iterations...", args.accesses);
    run_trace(&mut memory, args.accesses);

    let stats = memory.stats();
    info!("Trace completed");
    info!(
        "Lookups: {} | probes: {} | promotions: {}",
        stats.lookups, stats.probes, stats.promotions
    );
    info!(
        "Device accesses: {} | notifications: {} ({} rejected) | failed: {}",
        stats.device_accesses,
        stats.notifications,
        stats.rejected_notifications,
        stats.failed_accesses
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    }

    if let Some(path) = &args.snapshot {
        memory.map().snapshot().save_to_file(path)?;
    }

    Ok(())
}
