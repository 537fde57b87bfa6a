// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut

//! Memory subsystem tests
//!
//! Organised by concern:
//!
//! - `lookup`: move-to-front ordering and the guard invariant
//! - `access`: byte, word and long accessors over memory ranges
//! - `dispatch`: device and notify ranges, silent failure
//! - `properties`: proptest laws over random addresses and values
//! - `helpers`: common test utilities

use super::*;

mod helpers;
