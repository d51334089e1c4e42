//! CallbackContext - 通知を直列化する単一スレッドの実行コンテキスト
//!
//! # 設計
//! - 専用スレッド 1 本で current-thread の tokio runtime を回す
//! - `post()` されたコールバックは mpsc に積まれ、投入順（FIFO）に実行される
//! - `post_delayed()` は同じ runtime 上のタイマータスクで、期限が来たらキューに積む
//! - リスナー通知とキャッシュ更新はすべてここで行うので、互いに順序が入れ替わらない
//! - コールバックの panic はその 1 件だけを失い、コンテキストは生き続ける

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, PoisonError};
use std::thread::{JoinHandle, ThreadId};
use std::time::Duration;

use tokio::runtime::{Builder, Handle};
use tokio::sync::mpsc;

type Callback = Box<dyn FnOnce() + Send + 'static>;

enum Command {
    Run(Callback),
    Stop,
}

/// A single-threaded, FIFO execution context for notifications.
pub struct CallbackContext {
    tx: mpsc::UnboundedSender<Command>,
    handle: Handle,
    thread_id: ThreadId,
    worker: Mutex<Option<JoinHandle<()>>>,
}

/// A delayed callback that has not fired yet. Dropping it does not cancel.
#[derive(Debug)]
pub struct ScheduledCallback {
    timer: tokio::task::JoinHandle<()>,
}

impl ScheduledCallback {
    /// Cancel the callback if its timer has not fired yet.
    pub fn cancel(&self) {
        self.timer.abort();
    }
}

impl CallbackContext {
    /// Start the context thread.
    pub fn spawn(name: &str) -> std::io::Result<Self> {
        let runtime = Builder::new_current_thread().enable_time().build()?;
        let handle = runtime.handle().clone();
        let (tx, mut rx) = mpsc::unbounded_channel::<Command>();

        let worker = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                runtime.block_on(async move {
                    while let Some(command) = rx.recv().await {
                        match command {
                            Command::Run(callback) => {
                                if panic::catch_unwind(AssertUnwindSafe(callback)).is_err() {
                                    tracing::warn!("callback panicked");
                                }
                            }
                            Command::Stop => break,
                        }
                    }
                });
                tracing::debug!("callback context stopped");
            })?;

        Ok(Self {
            tx,
            handle,
            thread_id: worker.thread().id(),
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Is the caller running on this context's thread?
    pub fn is_current(&self) -> bool {
        std::thread::current().id() == self.thread_id
    }

    /// Queue `callback` behind everything already posted.
    ///
    /// Returns `false` once the context has been stopped.
    pub fn post<F>(&self, callback: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.tx.send(Command::Run(Box::new(callback))).is_ok()
    }

    /// Queue `callback` after `delay` has elapsed.
    pub fn post_delayed<F>(&self, delay: Duration, callback: F) -> ScheduledCallback
    where
        F: FnOnce() + Send + 'static,
    {
        let tx = self.tx.clone();
        let timer = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Command::Run(Box::new(callback)));
        });
        ScheduledCallback { timer }
    }

    /// Run a future on the context thread.
    pub fn spawn_future<F>(&self, future: F) -> tokio::task::JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(future)
    }

    /// Stop the context after the callbacks already queued have run.
    ///
    /// Pending delayed callbacks are dropped. When called from the context
    /// thread itself the stop is requested but not waited for.
    pub fn stop(&self) {
        let Some(worker) = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            return;
        };
        let _ = self.tx.send(Command::Stop);
        if self.is_current() {
            return;
        }
        if worker.join().is_err() {
            tracing::warn!("callback context thread panicked");
        }
    }
}

impl Drop for CallbackContext {
    fn drop(&mut self) {
        self.stop();
    }
}
