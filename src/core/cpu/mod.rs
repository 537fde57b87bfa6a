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

//! Glue between a 68000 interpreter and the memory subsystem
//!
//! The interpreter itself (instruction decoding, exceptions, interrupt
//! prioritisation) is an external collaborator behind [`M68kCore`]. This
//! module provides the bus it executes against and the control surface the
//! rest of the emulator drives it through.
//!
//! # Cycle scale
//!
//! The emulator schedules in host cycles, which are CPU cycles shifted left
//! by [`CYCLE_SCALE_SHIFT`]. [`CpuAdapter`] converts in both directions.

use crate::core::memory::{BusHandler, MemorySubsystem};

/// Host cycles per CPU cycle, as a power of two
pub const CYCLE_SCALE_SHIFT: u32 = 6;

/// Highest 68000 interrupt priority level
pub const MAX_IPL: u8 = 7;

/// Largest usable host cycle scale
pub const MAX_SCALE_SHIFT: u32 = 31;

/// The six accessors a CPU core executes through
///
/// Values are zero-extended to `u32`; writes use the low 8 or 16 bits.
/// Sign extension is the core's job.
pub trait CpuBus {
    fn read_byte(&mut self, addr: u32) -> u32;
    fn read_word(&mut self, addr: u32) -> u32;
    fn read_long(&mut self, addr: u32) -> u32;
    fn write_byte(&mut self, addr: u32, value: u32);
    fn write_word(&mut self, addr: u32, value: u32);
    fn write_long(&mut self, addr: u32, value: u32);
}

impl<H: BusHandler> CpuBus for MemorySubsystem<H> {
    #[inline]
    fn read_byte(&mut self, addr: u32) -> u32 {
        MemorySubsystem::read_byte(self, addr) as u32
    }

    #[inline]
    fn read_word(&mut self, addr: u32) -> u32 {
        MemorySubsystem::read_word(self, addr) as u32
    }

    #[inline]
    fn read_long(&mut self, addr: u32) -> u32 {
        MemorySubsystem::read_long(self, addr)
    }

    #[inline]
    fn write_byte(&mut self, addr: u32, value: u32) {
        MemorySubsystem::write_byte(self, addr, value as u8)
    }

    #[inline]
    fn write_word(&mut self, addr: u32, value: u32) {
        MemorySubsystem::write_word(self, addr, value as u16)
    }

    #[inline]
    fn write_long(&mut self, addr: u32, value: u32) {
        MemorySubsystem::write_long(self, addr, value)
    }
}

/// Control surface of a 68000 interpreter
///
/// Cycle counts here are CPU cycles. `cycles_remaining` may go negative
/// when an instruction overruns the timeslice.
pub trait M68kCore {
    /// Assert RESET: reload SSP and PC from the vector table
    fn pulse_reset(&mut self, bus: &mut dyn CpuBus);

    /// Set the interrupt priority level input
    fn set_irq(&mut self, level: u8);

    /// Run until the timeslice is used up; returns CPU cycles executed
    fn execute(&mut self, bus: &mut dyn CpuBus, cycles: i32) -> i32;

    fn cycles_remaining(&self) -> i32;

    /// Stop after the current instruction
    fn end_timeslice(&mut self);

    /// Add cycles to the current timeslice
    fn modify_timeslice(&mut self, cycles: i32);
}

/// Drives a [`M68kCore`] in host cycles
pub struct CpuAdapter<C: M68kCore> {
    core: C,
    shift: u32,
    ipl: u8,
}

impl<C: M68kCore> CpuAdapter<C> {
    pub fn new(core: C) -> Self {
        Self::with_shift(core, CYCLE_SCALE_SHIFT)
    }

    /// Adapter with a custom host cycle scale
    ///
    /// Shifts above [`MAX_SCALE_SHIFT`] are clamped.
    pub fn with_shift(core: C, shift: u32) -> Self {
        if shift > MAX_SCALE_SHIFT {
            log::warn!(
                "Cycle scale shift {} clamped to {}",
                shift,
                MAX_SCALE_SHIFT
            );
        }
        let shift = shift.min(MAX_SCALE_SHIFT);
        Self {
            core,
            shift,
            ipl: 0,
        }
    }

    pub fn core(&self) -> &C {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut C {
        &mut self.core
    }

    /// Current interrupt priority level
    pub fn interrupt_level(&self) -> u8 {
        self.ipl
    }

    pub fn reset(&mut self, bus: &mut dyn CpuBus) {
        log::info!("CPU reset");
        self.core.pulse_reset(bus);
    }

    /// Change the interrupt level and end the timeslice so the core sees it
    /// before executing further
    ///
    /// Levels above 7 are clamped.
    pub fn set_interrupt_level(&mut self, level: u8) {
        let level = level.min(MAX_IPL);
        if level != self.ipl {
            log::debug!("IPL {} -> {}", self.ipl, level);
        }
        self.ipl = level;
        self.core.set_irq(level);
        self.core.end_timeslice();
    }

    /// Run for `host_cycles`; returns CPU cycles the core executed
    ///
    /// Budgets beyond `i32::MAX` CPU cycles saturate.
    pub fn run_cycles(&mut self, bus: &mut dyn CpuBus, host_cycles: u32) -> i32 {
        let cycles = i32::try_from(host_cycles >> self.shift).unwrap_or(i32::MAX);
        self.core.execute(bus, cycles)
    }

    /// Host cycles left in the current timeslice
    ///
    /// An overrun ends the timeslice and reports zero.
    pub fn cycles_remaining(&mut self) -> i32 {
        let remaining = self.core.cycles_remaining();
        if remaining < 0 {
            self.core.end_timeslice();
            0
        } else {
            i32::try_from(i64::from(remaining) << self.shift).unwrap_or(i32::MAX)
        }
    }

    /// Replace the remainder of the current timeslice
    pub fn set_cycles_remaining(&mut self, host_cycles: i32) {
        self.core.end_timeslice();
        if host_cycles > 0 {
            self.core.modify_timeslice(host_cycles >> self.shift);
        }
    }
}
