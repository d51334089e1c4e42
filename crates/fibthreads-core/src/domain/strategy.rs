//! ComputeStrategy - 計算をどこで実行するか

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::FibError;

/// How a computation request reaches a worker.
///
/// - `Direct`: inline on the caller, which blocks until the result is ready.
/// - `RawThread`: one dedicated OS thread per request (unbounded).
/// - `Pooled`: a job on the fixed-size worker pool.
/// - `Task`: a `PoolTask` future on the same pool, awaited on the callback context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComputeStrategy {
    Direct,
    RawThread,
    Pooled,
    Task,
}

impl ComputeStrategy {
    pub const ALL: [ComputeStrategy; 4] = [
        ComputeStrategy::Direct,
        ComputeStrategy::RawThread,
        ComputeStrategy::Pooled,
        ComputeStrategy::Task,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ComputeStrategy::Direct => "direct",
            ComputeStrategy::RawThread => "raw_thread",
            ComputeStrategy::Pooled => "pooled",
            ComputeStrategy::Task => "task",
        }
    }
}

impl fmt::Display for ComputeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComputeStrategy {
    type Err = FibError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ComputeStrategy::ALL
            .into_iter()
            .find(|strategy| strategy.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| FibError::ParseStrategy(s.to_string()))
    }
}
