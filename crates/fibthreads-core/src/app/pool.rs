//! WorkerPool - 固定サイズのワーカースレッドプール
//!
//! # 学習ポイント
//! - Mutex + Condvar による blocking pop
//! - キュー長と実行中の数を同じロックの下で数える（pop した瞬間に「見えなくなる」仕事がない）
//! - `catch_unwind` でジョブの panic からワーカーを守る
//! - oneshot を使った Future ベースのタスク API（`PoolTask`）
//!
//! キューは無制限で、投入が拒否されることはない（バックプレッシャーは持たない）。

use std::collections::VecDeque;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::thread::JoinHandle;

use tokio::sync::oneshot;

use crate::domain::FibError;

type Job = Box<dyn FnOnce() + Send + 'static>;

struct PoolState {
    queue: VecDeque<Job>,
    active: usize,
    shutdown: bool,
}

struct Shared {
    state: Mutex<PoolState>,
    available: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Fixed-size pool of OS threads fed by an unbounded FIFO queue.
pub struct WorkerPool {
    shared: Arc<Shared>,
    size: usize,
    joins: Mutex<Vec<JoinHandle<()>>>,
}

/// Result of a job submitted with [`WorkerPool::spawn_task`].
///
/// Resolves to `None` if the job panicked or was discarded.
#[must_use = "a PoolTask does nothing unless awaited"]
pub struct PoolTask<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> Future for PoolTask<T> {
    type Output = Option<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(Result::ok)
    }
}

impl WorkerPool {
    /// Two workers per available processing unit.
    pub fn default_size() -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            * 2
    }

    /// Spawn `size` workers named `{name}-{i}`.
    pub fn spawn(size: usize, name: &str) -> std::io::Result<Self> {
        let shared = Arc::new(Shared {
            state: Mutex::new(PoolState {
                queue: VecDeque::new(),
                active: 0,
                shutdown: false,
            }),
            available: Condvar::new(),
        });

        let mut joins = Vec::with_capacity(size);
        for worker_id in 0..size {
            let shared = Arc::clone(&shared);
            let join = std::thread::Builder::new()
                .name(format!("{name}-{worker_id}"))
                .spawn(move || worker_loop(worker_id, shared))?;
            joins.push(join);
        }

        Ok(Self {
            shared,
            size,
            joins: Mutex::new(joins),
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Queue a job. Never blocks and never rejects while the pool is running.
    pub fn execute<F>(&self, job: F) -> Result<(), FibError>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.shared.lock();
        if state.shutdown {
            return Err(FibError::Disposed);
        }
        state.queue.push_back(Box::new(job));
        drop(state);

        self.shared.available.notify_one();
        Ok(())
    }

    /// Queue `work` and get a future for its return value.
    pub fn spawn_task<T, F>(&self, work: F) -> Result<PoolTask<T>, FibError>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.execute(move || {
            let _ = tx.send(work());
        })?;
        Ok(PoolTask { rx })
    }

    /// `(queued, active)`: jobs waiting for a worker and jobs running, read
    /// under one lock so a job being popped is counted exactly once.
    pub fn load(&self) -> (usize, usize) {
        let state = self.shared.lock();
        (state.queue.len(), state.active)
    }

    /// Stop taking new jobs, let the workers drain the queue, and join them.
    pub fn shutdown_and_join(&self) {
        {
            let mut state = self.shared.lock();
            if state.shutdown {
                return;
            }
            state.shutdown = true;
        }
        self.shared.available.notify_all();

        let joins = std::mem::take(&mut *self.joins.lock().unwrap_or_else(PoisonError::into_inner));
        for join in joins {
            let _ = join.join();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown_and_join();
    }
}

fn worker_loop(worker_id: usize, shared: Arc<Shared>) {
    loop {
        let job = {
            let mut state = shared.lock();
            loop {
                if let Some(job) = state.queue.pop_front() {
                    state.active += 1;
                    break job;
                }
                if state.shutdown {
                    return;
                }
                state = shared
                    .available
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        };

        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            tracing::warn!(worker_id, "pool job panicked");
        }

        shared.lock().active -= 1;
    }
}
