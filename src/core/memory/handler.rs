// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut

//! Device and notify dispatch
//!
//! Ranges that are not plain memory are served by a [`BusHandler`] owned by
//! the memory subsystem. The subsystem never needs to know what the devices
//! are: the handler receives the matching descriptor (including its `tag`)
//! and decides.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │            MemorySubsystem                  │
//! ├────────────────────────────────────────────┤
//! │  access(addr) {                             │
//! │    range = table.find(addr)                 │
//! │    if READY   -> cache + buffer access      │
//! │    if DEVICE  -> handler.device_access(..)  │
//! │    if NOTIFY  -> handler.access_notify(..)  │
//! │                  true  => retry lookup      │
//! │                  false => silent failure    │
//! │  }                                          │
//! └────────────────────────────────────────────┘
//!                      ▲
//!                      │
//!              ┌───────┴───────┐
//!              │  BusHandler   │
//!              │ (memory map)  │
//!              └───────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use vmacmem::core::memory::{BusHandler, DeviceRequest, RangeDescriptor};
//!
//! /// A single latch register that echoes the last value written
//! struct Latch {
//!     value: u32,
//! }
//!
//! impl BusHandler for Latch {
//!     fn device_access(&mut self, _range: &RangeDescriptor, request: DeviceRequest) -> u32 {
//!         if request.is_write() {
//!             self.value = request.value;
//!         }
//!         self.value
//!     }
//! }
//! ```

use super::table::RangeDescriptor;
use super::MemoryMap;

/// Direction of a device access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

/// Width of a device access
///
/// Long accesses reach devices as two word accesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    Byte,
    Word,
}

/// One access forwarded to a device handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceRequest {
    /// Logical address of the access
    pub address: u32,
    /// Value being written, zero for reads
    pub value: u32,
    pub direction: Direction,
    pub width: Width,
}

impl DeviceRequest {
    pub fn read(width: Width, address: u32) -> Self {
        Self {
            address,
            value: 0,
            direction: Direction::Read,
            width,
        }
    }

    pub fn write(width: Width, address: u32, value: u32) -> Self {
        Self {
            address,
            value,
            direction: Direction::Write,
            width,
        }
    }

    pub fn is_write(&self) -> bool {
        self.direction == Direction::Write
    }

    pub fn is_byte(&self) -> bool {
        self.width == Width::Byte
    }
}

/// Handler for ranges that are not directly backed by memory
///
/// The defaults fail silently: reads yield zero, writes are dropped, notify
/// declines. A handler only overrides what its memory map uses.
///
/// # Progress
///
/// `access_notify` returning `true` makes the subsystem retry the whole
/// access. The handler must have changed the map so that the retried lookup
/// makes progress; a handler that reports success without doing so loops
/// forever.
pub trait BusHandler {
    /// Serve an access to a `DEVICE` range
    ///
    /// Called for every access, never cached. The return value is the read
    /// result and is ignored for writes. Only the low 8 or 16 bits are used.
    fn device_access(&mut self, range: &RangeDescriptor, request: DeviceRequest) -> u32 {
        log::trace!(
            "Unhandled device access (tag {}) at 0x{:08X}",
            range.tag,
            request.address
        );
        0
    }

    /// Resolve a `NOTIFY` range
    ///
    /// The handler may add banks, fill them and install a new table on
    /// `map`. Returns whether the access should be retried.
    fn access_notify(&mut self, range: &RangeDescriptor, map: &mut MemoryMap) -> bool {
        let _ = map;
        log::trace!("Unhandled notify (tag {})", range.tag);
        false
    }

    /// Name for logging
    fn name(&self) -> &str {
        "Unknown Handler"
    }
}

/// Handler for maps that contain only memory ranges
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHandler;

impl BusHandler for NullHandler {
    fn name(&self) -> &str {
        "NullHandler"
    }
}

impl<H: BusHandler + ?Sized> BusHandler for Box<H> {
    fn device_access(&mut self, range: &RangeDescriptor, request: DeviceRequest) -> u32 {
        (**self).device_access(range, request)
    }

    fn access_notify(&mut self, range: &RangeDescriptor, map: &mut MemoryMap) -> bool {
        (**self).access_notify(range, map)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
