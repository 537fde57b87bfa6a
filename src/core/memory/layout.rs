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

//! Declarative memory-map layouts
//!
//! A layout names the banks a machine needs and the ranges that point into
//! them, in table order. It is how a memory-map owner (or the CLI) builds
//! [`Banks`] and [`AddressTable`]s without hand-writing descriptors.
//!
//! # Format
//!
//! ```toml
//! [[bank]]
//! name = "ram"
//! size = 0x400000
//!
//! [[range]]
//! name = "ram"
//! cmp_mask = 0x00C00000
//! cmp_value = 0x00000000
//! access = ["read", "write"]
//! bank = "ram"
//! use_mask = 0x003FFFFF
//! ```
//!
//! `base` and `tag` default to 0. Device and notify ranges omit `bank`.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::banks::Banks;
use super::table::{Access, AddressTable, Backing, RangeDescriptor, TableBuilder};
use crate::core::error::{LayoutError, Result};

/// Range capability as spelled in layout files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessKind {
    Read,
    Write,
    Device,
    Notify,
}

impl AccessKind {
    fn flag(self) -> Access {
        match self {
            AccessKind::Read => Access::READ_READY,
            AccessKind::Write => Access::WRITE_READY,
            AccessKind::Device => Access::DEVICE,
            AccessKind::Notify => Access::NOTIFY,
        }
    }
}

/// A backing buffer to allocate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankLayout {
    pub name: String,
    pub size: usize,
}

/// One table entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeLayout {
    pub name: String,
    pub cmp_mask: u32,
    pub cmp_value: u32,
    #[serde(default)]
    pub access: Vec<AccessKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank: Option<String>,
    #[serde(default)]
    pub base: u32,
    #[serde(default)]
    pub use_mask: u32,
    #[serde(default)]
    pub tag: u32,
}

impl RangeLayout {
    fn access(&self) -> Access {
        self.access
            .iter()
            .fold(Access::empty(), |acc, kind| acc | kind.flag())
    }
}

/// A complete memory map description
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapLayout {
    #[serde(default, rename = "bank")]
    pub banks: Vec<BankLayout>,
    #[serde(default, rename = "range")]
    pub ranges: Vec<RangeLayout>,
}

/// Device tags used by [`MapLayout::mac_plus`]
pub mod tags {
    pub const SCC: u32 = 1;
    pub const IWM: u32 = 2;
    pub const VIA: u32 = 3;
    pub const EXPANSION: u32 = 4;
}

impl MapLayout {
    /// Parse a layout from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a layout file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Serialise back to TOML
    pub fn to_toml_string(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string(self)
    }

    /// 24-bit Macintosh Plus style map
    ///
    /// | Window            | Range              | Kind                |
    /// |-------------------|--------------------|---------------------|
    /// | RAM (4MB)         | 0x000000-0x3FFFFF  | read/write          |
    /// | ROM (128KB)       | 0x400000-0x4FFFFF  | read, mirrored      |
    /// | SCC               | 0x800000-0xBFFFFF  | device              |
    /// | IWM               | 0xC00000-0xDFFFFF  | device              |
    /// | VIA               | 0xE00000-0xEFFFFF  | device              |
    /// | Expansion         | 0xF00000-0xF7FFFF  | notify              |
    ///
    /// The upper address byte is ignored, as on the real 24-bit bus. The
    /// `expansion` bank exists from the start so a notify handler can map it
    /// in with [`MapLayout::expanded`].
    pub fn mac_plus() -> Self {
        let range = |name: &str, cmp_mask, cmp_value, access: &[AccessKind]| RangeLayout {
            name: name.to_string(),
            cmp_mask,
            cmp_value,
            access: access.to_vec(),
            bank: None,
            base: 0,
            use_mask: 0,
            tag: 0,
        };

        Self {
            banks: vec![
                BankLayout {
                    name: "ram".to_string(),
                    size: 0x40_0000,
                },
                BankLayout {
                    name: "rom".to_string(),
                    size: 0x2_0000,
                },
                BankLayout {
                    name: "expansion".to_string(),
                    size: 0x8_0000,
                },
            ],
            ranges: vec![
                RangeLayout {
                    bank: Some("ram".to_string()),
                    use_mask: 0x003F_FFFF,
                    ..range(
                        "ram",
                        0x00C0_0000,
                        0x0000_0000,
                        &[AccessKind::Read, AccessKind::Write],
                    )
                },
                RangeLayout {
                    bank: Some("rom".to_string()),
                    use_mask: 0x0001_FFFF,
                    ..range("rom", 0x00F0_0000, 0x0040_0000, &[AccessKind::Read])
                },
                RangeLayout {
                    tag: tags::SCC,
                    ..range("scc", 0x00C0_0000, 0x0080_0000, &[AccessKind::Device])
                },
                RangeLayout {
                    tag: tags::IWM,
                    ..range("iwm", 0x00E0_0000, 0x00C0_0000, &[AccessKind::Device])
                },
                RangeLayout {
                    tag: tags::VIA,
                    ..range("via", 0x00F0_0000, 0x00E0_0000, &[AccessKind::Device])
                },
                RangeLayout {
                    tag: tags::EXPANSION,
                    ..range("expansion", 0x00F8_0000, 0x00F0_0000, &[AccessKind::Notify])
                },
            ],
        }
    }

    /// Copy of this layout with the named notify range turned into a
    /// read/write window onto `bank`
    ///
    /// Used by notify handlers that map media in on first touch. Returns
    /// `None` when no notify range has that name, so a handler can refuse
    /// the access instead of reinstalling an unchanged table.
    pub fn expanded(&self, range: &str, bank: &str, use_mask: u32) -> Option<Self> {
        let is_target =
            |r: &RangeLayout| r.name == range && r.access.contains(&AccessKind::Notify);
        if !self.ranges.iter().any(is_target) {
            return None;
        }

        let mut layout = self.clone();
        for entry in layout.ranges.iter_mut().filter(|r| is_target(r)) {
            entry.access = vec![AccessKind::Read, AccessKind::Write];
            entry.bank = Some(bank.to_string());
            entry.base = 0;
            entry.use_mask = use_mask;
        }
        Some(layout)
    }

    /// Allocate zero-filled banks
    ///
    /// # Errors
    ///
    /// `LayoutError::DuplicateBank` or `LayoutError::EmptyBank`.
    pub fn build_banks(&self) -> Result<Banks> {
        let mut seen = HashSet::new();
        let mut banks = Banks::new();

        for bank in &self.banks {
            if !seen.insert(bank.name.as_str()) {
                return Err(LayoutError::DuplicateBank(bank.name.clone()).into());
            }
            if bank.size == 0 {
                return Err(LayoutError::EmptyBank(bank.name.clone()).into());
            }
            banks.add(&bank.name, bank.size);
        }

        Ok(banks)
    }

    /// Build the table against already allocated banks
    ///
    /// # Errors
    ///
    /// `LayoutError::UnknownBank` for a bank name not in `banks`,
    /// `LayoutError::MissingBank` for a cacheable range without a bank, and
    /// table errors from the builder.
    pub fn build_table(&self, banks: &Banks) -> Result<AddressTable> {
        let mut builder = TableBuilder::new();

        for range in &self.ranges {
            let access = range.access();
            let mut descriptor =
                RangeDescriptor::new(range.cmp_mask, range.cmp_value, access).with_tag(range.tag);

            match &range.bank {
                Some(name) => {
                    let bank = banks
                        .find(name)
                        .ok_or_else(|| LayoutError::UnknownBank(name.clone()))?;
                    descriptor =
                        descriptor.with_backing(Backing::new(bank, range.base, range.use_mask));
                }
                None if access.intersects(Access::READ_READY | Access::WRITE_READY) => {
                    return Err(LayoutError::MissingBank(range.name.clone()).into());
                }
                None => {}
            }

            builder = builder.range(descriptor);
        }

        Ok(builder.build()?)
    }
}
