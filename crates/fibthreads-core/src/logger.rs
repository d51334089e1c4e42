//! FileLogger - バックグラウンドスレッドでファイルに追記するロガー
//!
//! # 設計
//! - 呼び出し側は整形した 1 行をチャネルに積むだけ（IO で待たない）
//! - 専用スレッドが 1 本だけファイルを持ち、FIFO で書き込む
//! - 1 行は 1 回の `write_all` で書くので、2 つのメッセージが混ざらない
//! - shutdown 時はキューに残っている行を書き切ってから flush・close する

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use tokio::sync::mpsc;

use crate::domain::FibError;

const THREAD_NAME: &str = "fib-file-logger";

enum LogCommand {
    Line(String),
    Shutdown,
}

/// Format a log entry. Embedded newlines become a single space so every
/// entry is exactly one line.
pub fn format_log_line(tag: &str, message: &str) -> String {
    format!("{}: {}\n", tag.replace('\n', " "), message.replace('\n', " "))
}

/// Append-only file logger backed by one dedicated thread.
pub struct FileLogger {
    path: PathBuf,
    tx: mpsc::UnboundedSender<LogCommand>,
    open: AtomicBool,
    pending: Arc<AtomicUsize>,
    worker: Mutex<Option<JoinHandle<bool>>>,
}

impl FileLogger {
    /// Open `path` for append (created if missing) and start the writer thread.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FibError> {
        let path = path.as_ref().to_path_buf();
        let open_err = |source| FibError::OpenLogSink {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(open_err)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(open_err)?;

        let (tx, rx) = mpsc::unbounded_channel();
        let pending = Arc::new(AtomicUsize::new(0));
        let worker = std::thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn({
                let pending = Arc::clone(&pending);
                let path = path.clone();
                move || write_loop(file, rx, pending, path)
            })
            .map_err(open_err)?;

        tracing::info!(path = %path.display(), "file logger opened");
        Ok(Self {
            path,
            tx,
            open: AtomicBool::new(true),
            pending,
            worker: Mutex::new(Some(worker)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Lines accepted but not yet written.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Queue one entry for the writer thread. No-op once shut down.
    pub fn log_message(&self, tag: &str, message: &str) {
        if !self.is_open() {
            tracing::debug!(path = %self.path.display(), "log message dropped: logger closed");
            return;
        }

        self.pending.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(LogCommand::Line(format_log_line(tag, message))).is_err() {
            // writer thread already gone
            self.pending.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// Stop accepting messages, write out what is queued, flush and release
    /// the file.
    ///
    /// Returns `true` when this call shut the logger down cleanly, `false` if
    /// it was already closed or the final flush failed.
    pub fn shutdown(&self) -> bool {
        if !self.open.swap(false, Ordering::SeqCst) {
            return false;
        }
        tracing::info!(path = %self.path.display(), "shutting down file logger");

        let _ = self.tx.send(LogCommand::Shutdown);
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match worker.map(JoinHandle::join) {
            Some(Ok(flushed)) => flushed,
            Some(Err(_)) => {
                tracing::warn!(path = %self.path.display(), "file logger thread panicked");
                false
            }
            None => false,
        }
    }
}

impl Drop for FileLogger {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn write_loop(
    mut file: File,
    mut rx: mpsc::UnboundedReceiver<LogCommand>,
    pending: Arc<AtomicUsize>,
    path: PathBuf,
) -> bool {
    while let Some(command) = rx.blocking_recv() {
        match command {
            LogCommand::Line(line) => {
                if let Err(e) = file.write_all(line.as_bytes()).and_then(|()| file.flush()) {
                    tracing::warn!(path = %path.display(), error = %e, "unable to write log message");
                }
                pending.fetch_sub(1, Ordering::SeqCst);
            }
            LogCommand::Shutdown => break,
        }
    }

    // Lines sent before Shutdown are already written (FIFO). Anything that
    // raced in afterwards is dropped with the receiver.
    rx.close();
    while let Ok(LogCommand::Line(_)) = rx.try_recv() {
        pending.fetch_sub(1, Ordering::SeqCst);
    }

    match file.flush().and_then(|()| file.sync_all()) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "unable to close log file");
            false
        }
    }
}
