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

/// Emulator error types
///
/// Memory accessors never produce these: an unmapped or rejected access
/// fails silently, like the real bus. Errors only surface while building,
/// installing, loading or saving memory maps.
use thiserror::Error;

/// Result type for emulator operations
pub type Result<T> = std::result::Result<T, EmulatorError>;

/// Main error type for the emulator
#[derive(Error, Debug)]
pub enum EmulatorError {
    #[error("Translation table error: {0}")]
    Table(#[from] TableError),

    #[error("Layout error: {0}")]
    Layout(#[from] LayoutError),

    #[error("Invalid ROM size: {got} bytes (expected {expected})")]
    InvalidRomSize { expected: usize, got: usize },

    #[error("ROM file not found: {0}")]
    RomNotFound(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Snapshot encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("Snapshot decode error: {0}")]
    Decode(#[from] bincode::error::DecodeError),
}

/// Translation-table construction and installation errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TableError {
    #[error("Guard entry must match every address (mask 0x{mask:08X}, value 0x{value:08X})")]
    InvalidGuard { mask: u32, value: u32 },

    #[error("Guard entry must not be readable or writable")]
    CacheableGuard,

    #[error("Range {index} is cacheable but has no backing buffer")]
    MissingBacking { index: usize },

    #[error("Range {index} refers to unknown bank {bank}")]
    UnknownBank { index: usize, bank: usize },

    #[error("Range {index} reaches offset 0x{end:08X} past the end of bank {bank} ({len} bytes)")]
    BackingOutOfBounds {
        index: usize,
        bank: usize,
        end: usize,
        len: usize,
    },
}

/// Memory-map layout description errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum LayoutError {
    #[error("Unknown bank name: {0}")]
    UnknownBank(String),

    #[error("Duplicate bank name: {0}")]
    DuplicateBank(String),

    #[error("Bank {0} has zero size")]
    EmptyBank(String),

    #[error("Range {0} is cacheable but names no bank")]
    MissingBank(String),
}
