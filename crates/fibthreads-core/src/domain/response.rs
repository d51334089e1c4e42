//! FibonacciResponse - 計算結果のレコード
//!
//! 計算が終わった時点で engine が作り、その後は誰も書き換えない。
//! `Clone` して複数のコンテキストで読み取り専用に共有してよい。

use std::fmt;

use serde::{Deserialize, Serialize};

/// The result of one sequence computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FibonacciResponse {
    /// Requested sequence index.
    pub n: i64,

    /// Computed sequence value.
    pub result: i64,

    /// Wall-clock duration of the computation, in milliseconds.
    pub compute_time_ms: u64,
}

impl FibonacciResponse {
    pub fn new(n: i64, result: i64, compute_time_ms: u64) -> Self {
        Self {
            n,
            result,
            compute_time_ms,
        }
    }

    /// Compute time in seconds (what the log line and UI show).
    pub fn compute_time_secs(&self) -> f64 {
        self.compute_time_ms as f64 / 1000.0
    }
}

impl fmt::Display for FibonacciResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "N: {}\tResult: {}\nTime: {:.3}",
            self.n,
            self.result,
            self.compute_time_secs()
        )
    }
}
