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

//! Memory snapshots
//!
//! A snapshot captures the contents of every bank, by name, so RAM and
//! expansion state can be saved and restored later. The translation table is
//! not part of a snapshot: it is rebuilt by whoever owns the memory map.
//!
//! Snapshots are encoded with bincode and carry a version number; loading a
//! snapshot with a different version fails.
//!
//! # Example
//!
//! ```no_run
//! use vmacmem::core::memory::{MemoryMap, MemorySnapshot};
//!
//! let mut map = MemoryMap::new();
//! map.add_bank("ram", 0x1000);
//!
//! map.snapshot().save_to_file("ram.snap").unwrap();
//!
//! let snapshot = MemorySnapshot::load_from_file("ram.snap").unwrap();
//! map.restore(&snapshot).unwrap();
//! ```

use bincode::{config, Decode, Encode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use super::MemoryMap;
use crate::core::error::{EmulatorError, Result};

/// Snapshot format version
///
/// Bump whenever the encoding changes incompatibly.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Contents of one bank
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct BankImage {
    pub name: String,
    pub data: Vec<u8>,
}

/// Contents of every bank of a memory map
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
#[bincode(encode_bounds = "", decode_bounds = "")]
pub struct MemorySnapshot {
    pub version: u32,

    /// When the snapshot was taken
    #[bincode(with_serde)]
    pub created: DateTime<Utc>,

    /// Banks in allocation order
    pub banks: Vec<BankImage>,
}

impl MemorySnapshot {
    /// Total number of bank bytes held
    pub fn size(&self) -> usize {
        self.banks.iter().map(|bank| bank.data.len()).sum()
    }

    /// Write the snapshot to a file
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails or the file cannot be written.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let encoded = bincode::encode_to_vec(self, config::standard())?;
        let mut file = File::create(path.as_ref())?;
        file.write_all(&encoded)?;
        log::info!(
            "Saved memory snapshot ({} banks, {} bytes) to {}",
            self.banks.len(),
            self.size(),
            path.as_ref().display()
        );
        Ok(())
    }

    /// Read a snapshot from a file and check its version
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, decoding fails or the
    /// version does not match [`SNAPSHOT_VERSION`].
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;

        let (snapshot, _): (MemorySnapshot, usize) =
            bincode::decode_from_slice(&buffer, config::standard())?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(EmulatorError::Snapshot(format!(
                "Incompatible snapshot version: expected {}, got {}",
                SNAPSHOT_VERSION, snapshot.version
            )));
        }

        Ok(snapshot)
    }
}

impl MemoryMap {
    /// Capture the contents of every bank
    pub fn snapshot(&self) -> MemorySnapshot {
        MemorySnapshot {
            version: SNAPSHOT_VERSION,
            created: Utc::now(),
            banks: self
                .banks
                .iter()
                .map(|(_, name, data)| BankImage {
                    name: name.to_string(),
                    data: data.to_vec(),
                })
                .collect(),
        }
    }

    /// Copy snapshot contents back into the banks of the same name
    ///
    /// Every image must name an existing bank of identical size. Nothing is
    /// written unless the whole snapshot fits. The caches stay valid since
    /// no bank moves or changes size.
    ///
    /// # Errors
    ///
    /// `EmulatorError::Snapshot` on a version mismatch, an unknown bank name
    /// or a size mismatch.
    pub fn restore(&mut self, snapshot: &MemorySnapshot) -> Result<()> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(EmulatorError::Snapshot(format!(
                "Incompatible snapshot version: expected {}, got {}",
                SNAPSHOT_VERSION, snapshot.version
            )));
        }

        let mut targets = Vec::with_capacity(snapshot.banks.len());
        for image in &snapshot.banks {
            let id = self.banks.find(&image.name).ok_or_else(|| {
                EmulatorError::Snapshot(format!("Unknown bank in snapshot: {}", image.name))
            })?;
            let len = self.banks.len_of(id).unwrap_or(0);
            if len != image.data.len() {
                return Err(EmulatorError::Snapshot(format!(
                    "Bank {} is {} bytes, snapshot holds {}",
                    image.name,
                    len,
                    image.data.len()
                )));
            }
            targets.push((id, image));
        }

        for (id, image) in targets {
            if let Some(bank) = self.banks.bank_mut(id) {
                bank.copy_from_slice(&image.data);
            }
        }

        log::debug!("Restored {} banks from snapshot", snapshot.banks.len());
        Ok(())
    }
}
