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

//! Core emulation components
//!
//! - Memory: translation table, caches, backing banks and dispatch
//! - CPU: the bus and control surface a 68000 interpreter plugs into

pub mod cpu;
pub mod error;
pub mod memory;

// Re-export commonly used types
pub use cpu::{CpuAdapter, CpuBus, M68kCore};
pub use error::{EmulatorError, Result};
pub use memory::{MemoryMap, MemorySubsystem};
