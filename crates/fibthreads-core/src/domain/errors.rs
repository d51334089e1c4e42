//! Errors - エラー型
//!
//! 計算そのものは失敗しない。失敗しうるのはリソース取得（ログファイル、スレッド）だけ。

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FibError {
    #[error("unable to open log sink {}: {source}", .path.display())]
    OpenLogSink {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to spawn compute thread: {0}")]
    SpawnThread(#[source] io::Error),

    #[error("dispatcher has been disposed")]
    Disposed,

    #[error("unknown compute strategy '{0}'")]
    ParseStrategy(String),
}
