//! DispatcherBuilder - 設定とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - serde による設定ファイル（JSON）の読み込み

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::dispatcher::FibDispatcher;
use super::pool::WorkerPool;
use crate::domain::FibError;

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
pub const DEFAULT_LOG_TAG: &str = "FibDispatcher";

/// Dispatcher settings. Every field has a default, so a partial JSON
/// document is enough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Worker threads in the pool (default: 2 × available cores).
    pub pool_size: usize,

    /// How often the activity poll re-checks outstanding work.
    pub poll_interval_ms: u64,

    /// Tag written in front of every logged result.
    pub log_tag: String,

    /// Append delivered results to this file.
    pub log_file: Option<PathBuf>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            pool_size: WorkerPool::default_size(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            log_tag: DEFAULT_LOG_TAG.to_string(),
            log_file: None,
        }
    }
}

impl DispatcherConfig {
    pub fn from_json_str(json: &str) -> Result<Self, BuildError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn validate(&self) -> Result<(), BuildError> {
        if self.pool_size == 0 {
            return Err(BuildError::EmptyPool);
        }
        if self.poll_interval_ms == 0 {
            return Err(BuildError::ZeroPollInterval);
        }
        Ok(())
    }
}

/// BuildError は dispatcher 構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("pool_size must be at least 1")]
    EmptyPool,

    #[error("poll_interval_ms must be greater than 0")]
    ZeroPollInterval,

    #[error("invalid dispatcher config: {0}")]
    Config(#[from] serde_json::Error),

    #[error("unable to start dispatcher threads: {0}")]
    Spawn(#[from] std::io::Error),

    #[error(transparent)]
    LogSink(#[from] FibError),
}

/// DispatcherBuilder は FibDispatcher を構築
///
/// # 使用例
/// ```ignore
/// let dispatcher = DispatcherBuilder::new()
///     .pool_size(4)
///     .log_file("/tmp/fib.log")
///     .build()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct DispatcherBuilder {
    config: DispatcherConfig,
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: DispatcherConfig) -> Self {
        Self { config }
    }

    pub fn pool_size(mut self, pool_size: usize) -> Self {
        self.config.pool_size = pool_size;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn log_tag(mut self, tag: impl Into<String>) -> Self {
        self.config.log_tag = tag.into();
        self
    }

    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.log_file = Some(path.into());
        self
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// 設定を検証してから dispatcher を起動する
    pub fn build(self) -> Result<Arc<FibDispatcher>, BuildError> {
        self.config.validate()?;
        FibDispatcher::from_config(self.config)
    }
}
