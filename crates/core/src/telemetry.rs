// Copyright 2025 LLM Codebench Contributors
// SPDX-License-Identifier: Apache-2.0

//! GPU memory telemetry values.
//!
//! A reading is either a used-memory figure in MB or `Unavailable`. On the
//! wire (CSV, console) `Unavailable` is written as `-1`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw value written for an unavailable reading.
pub const UNAVAILABLE_SENTINEL: i64 = -1;

/// One GPU memory reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TelemetrySample {
    /// Used memory in MB.
    Available(u64),
    /// No reading could be taken.
    Unavailable,
}

/// Change in GPU memory across one generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryDelta {
    /// `end - start` in MB; negative when memory was freed.
    Available(i64),
    /// At least one of the two readings was unavailable.
    Unavailable,
}

impl MemoryDelta {
    /// Delta between two readings, available only if both are.
    pub fn between(start: TelemetrySample, end: TelemetrySample) -> Self {
        match (start, end) {
            (TelemetrySample::Available(start), TelemetrySample::Available(end)) => {
                MemoryDelta::Available(end as i64 - start as i64)
            }
            _ => MemoryDelta::Unavailable,
        }
    }

    /// Delta in MB, if available.
    pub fn mb(&self) -> Option<i64> {
        match self {
            MemoryDelta::Available(mb) => Some(*mb),
            MemoryDelta::Unavailable => None,
        }
    }

    /// Raw encoding, `-1` when unavailable.
    pub fn as_raw(&self) -> i64 {
        self.mb().unwrap_or(UNAVAILABLE_SENTINEL)
    }
}

impl fmt::Display for MemoryDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_raw())
    }
}
