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

//! Physical backing memory
//!
//! Banks are the host buffers that cacheable ranges point into: main RAM,
//! ROM, the framebuffer, expansion images. A bank is allocated once with a
//! fixed size and is never resized or freed while the map is alive, so a
//! translation table validated against the banks stays valid for as long
//! as it is installed.
//!
//! Multi-byte accesses are big-endian, matching the 68000.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::core::error::{EmulatorError, Result};

/// Handle to a bank inside [`Banks`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BankId(pub(crate) usize);

impl BankId {
    /// Position of the bank in allocation order
    pub fn index(self) -> usize {
        self.0
    }
}

/// A named, fixed-size host buffer
struct Bank {
    name: String,
    data: Box<[u8]>,
}

/// Collection of physical backing buffers
#[derive(Default)]
pub struct Banks {
    banks: Vec<Bank>,
}

impl Banks {
    /// Create an empty bank set
    pub fn new() -> Self {
        Self { banks: Vec::new() }
    }

    /// Allocate a zero-filled bank and return its handle
    ///
    /// # Example
    ///
    /// ```
    /// use vmacmem::core::memory::Banks;
    ///
    /// let mut banks = Banks::new();
    /// let ram = banks.add("ram", 0x1000);
    /// assert_eq!(banks.len_of(ram), Some(0x1000));
    /// assert_eq!(banks.find("ram"), Some(ram));
    /// ```
    pub fn add(&mut self, name: &str, size: usize) -> BankId {
        self.add_with_data(name, vec![0u8; size])
    }

    /// Add a bank initialised from existing contents
    pub fn add_with_data(&mut self, name: &str, data: Vec<u8>) -> BankId {
        let id = BankId(self.banks.len());
        log::debug!("Bank {} '{}' allocated ({} bytes)", id.0, name, data.len());
        self.banks.push(Bank {
            name: name.to_string(),
            data: data.into_boxed_slice(),
        });
        id
    }

    /// Look a bank up by name
    pub fn find(&self, name: &str) -> Option<BankId> {
        self.banks
            .iter()
            .position(|bank| bank.name == name)
            .map(BankId)
    }

    /// Name of a bank
    pub fn name(&self, id: BankId) -> Option<&str> {
        self.banks.get(id.0).map(|bank| bank.name.as_str())
    }

    /// Size of a bank in bytes, or `None` for an unknown handle
    pub fn len_of(&self, id: BankId) -> Option<usize> {
        self.banks.get(id.0).map(|bank| bank.data.len())
    }

    /// Number of banks
    pub fn count(&self) -> usize {
        self.banks.len()
    }

    /// Iterate over `(id, name, contents)` in allocation order
    pub fn iter(&self) -> impl Iterator<Item = (BankId, &str, &[u8])> {
        self.banks
            .iter()
            .enumerate()
            .map(|(index, bank)| (BankId(index), bank.name.as_str(), &bank.data[..]))
    }

    /// Read-only view of a bank
    pub fn bank(&self, id: BankId) -> Option<&[u8]> {
        self.banks.get(id.0).map(|bank| &bank.data[..])
    }

    /// Mutable view of a bank
    ///
    /// The slice cannot change length, which keeps installed tables valid.
    pub fn bank_mut(&mut self, id: BankId) -> Option<&mut [u8]> {
        self.banks.get_mut(id.0).map(|bank| &mut bank.data[..])
    }

    /// Fill a bank from an image file whose size must match the bank exactly
    ///
    /// # Errors
    ///
    /// - `EmulatorError::RomNotFound` if the file cannot be opened
    /// - `EmulatorError::InvalidRomSize` if the file size differs from the bank
    pub fn load_image<P: AsRef<Path>>(&mut self, id: BankId, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut file = File::open(path)
            .map_err(|_| EmulatorError::RomNotFound(path.display().to_string()))?;
        let metadata = file.metadata()?;

        let bank = self
            .banks
            .get_mut(id.0)
            .ok_or_else(|| EmulatorError::RomNotFound(format!("bank {}", id.0)))?;

        if metadata.len() != bank.data.len() as u64 {
            return Err(EmulatorError::InvalidRomSize {
                expected: bank.data.len(),
                got: metadata.len() as usize,
            });
        }

        file.read_exact(&mut bank.data)?;
        log::info!("Loaded {} into bank '{}'", path.display(), bank.name);
        Ok(())
    }

    // Hot-path accessors. Offsets come from validated ranges, so indexing
    // out of bounds means a table was installed without validation.

    #[inline(always)]
    pub(crate) fn read_u8(&self, id: BankId, offset: usize) -> u8 {
        self.banks[id.0].data[offset]
    }

    #[inline(always)]
    pub(crate) fn write_u8(&mut self, id: BankId, offset: usize, value: u8) {
        self.banks[id.0].data[offset] = value;
    }

    #[inline(always)]
    pub(crate) fn read_u16(&self, id: BankId, offset: usize) -> u16 {
        let data = &self.banks[id.0].data;
        u16::from_be_bytes([data[offset], data[offset + 1]])
    }

    #[inline(always)]
    pub(crate) fn write_u16(&mut self, id: BankId, offset: usize, value: u16) {
        let data = &mut self.banks[id.0].data;
        let bytes = value.to_be_bytes();
        data[offset] = bytes[0];
        data[offset + 1] = bytes[1];
    }
}
