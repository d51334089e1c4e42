//! CachedLoader - 直近の結果を保持して再接続に備えるラッパー
//!
//! # 使用例
//! ```ignore
//! let loader = CachedLoader::new(dispatcher);
//! loader.attach(observer.clone());
//! loader.start(40)?;          // 計算開始（結果は callback context で届く）
//! loader.detach();            // 画面回転などで observer が外れる
//! loader.attach(new_observer);
//! loader.start(40)?;          // キャッシュ済みなら再計算せずその場で配送
//! ```
//!
//! # 保証
//! - 同じ n に対する計算は reset までに高々 1 回
//! - 計算中にもう一度 `start(n)` しても、進行中の計算に合流するだけ
//! - 違う n で `start` すると古い結果は捨てる（世代番号で判定）

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::dispatcher::FibDispatcher;
use crate::domain::{FibError, FibonacciResponse};
use crate::ports::LoaderObserver;

/// What `start` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStart {
    /// Cached result delivered synchronously.
    Cached(FibonacciResponse),
    /// Joined the computation already in flight for this `n`.
    Coalesced,
    /// Launched a new computation.
    Started,
}

#[derive(Default)]
struct LoaderState {
    n: Option<i64>,
    cached: Option<FibonacciResponse>,
    in_flight: bool,
    generation: u64,
    observer: Option<Arc<dyn LoaderObserver>>,
}

fn lock(state: &Mutex<LoaderState>) -> MutexGuard<'_, LoaderState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct CachedLoader {
    dispatcher: Arc<FibDispatcher>,
    state: Arc<Mutex<LoaderState>>,
    loads_started: AtomicUsize,
}

impl CachedLoader {
    pub fn new(dispatcher: Arc<FibDispatcher>) -> Self {
        Self {
            dispatcher,
            state: Arc::new(Mutex::new(LoaderState::default())),
            loads_started: AtomicUsize::new(0),
        }
    }

    pub fn attach<O>(&self, observer: Arc<O>)
    where
        O: LoaderObserver + 'static,
    {
        let observer: Arc<dyn LoaderObserver> = observer;
        lock(&self.state).observer = Some(observer);
    }

    pub fn detach(&self) {
        lock(&self.state).observer = None;
    }

    /// Deliver the cached result for `n`, join the load in flight, or start
    /// a new one.
    pub fn start(&self, n: i64) -> Result<LoadStart, FibError> {
        let mut state = lock(&self.state);
        if state.n == Some(n) {
            if let Some(cached) = state.cached {
                let observer = state.observer.clone();
                drop(state);
                if let Some(observer) = observer {
                    observer.on_load_finished(&cached);
                }
                return Ok(LoadStart::Cached(cached));
            }
            if state.in_flight {
                return Ok(LoadStart::Coalesced);
            }
        }

        state.n = Some(n);
        state.cached = None;
        state.in_flight = true;
        state.generation += 1;
        let generation = state.generation;
        drop(state);

        self.force_load(n, generation)?;
        Ok(LoadStart::Started)
    }

    fn force_load(&self, n: i64, generation: u64) -> Result<(), FibError> {
        let task = match self.dispatcher.compute_task(n) {
            Ok(task) => task,
            Err(e) => {
                let mut state = lock(&self.state);
                if state.generation == generation {
                    state.in_flight = false;
                }
                return Err(e);
            }
        };
        self.loads_started.fetch_add(1, Ordering::SeqCst);

        let state = Arc::clone(&self.state);
        self.dispatcher.callbacks().spawn_future(async move {
            let response = task.await;
            let delivery = {
                let mut state = lock(&state);
                if state.generation != generation {
                    tracing::debug!(n, "discarding result of a superseded load");
                    return;
                }
                state.in_flight = false;
                let Some(response) = response else {
                    tracing::warn!(n, "load finished without a result");
                    return;
                };
                state.cached = Some(response);
                state.observer.clone().map(|observer| (observer, response))
            };

            match delivery {
                Some((observer, response)) => observer.on_load_finished(&response),
                None => tracing::debug!(n, "no observer attached; result kept for reconnect"),
            }
        });
        Ok(())
    }

    /// Forget the configuration and the cached result. A load in flight is
    /// left to finish but its result is discarded.
    pub fn reset(&self) {
        let observer = {
            let mut state = lock(&self.state);
            state.n = None;
            state.cached = None;
            state.in_flight = false;
            state.generation += 1;
            state.observer.clone()
        };
        if let Some(observer) = observer {
            observer.on_loader_reset();
        }
    }

    pub fn cached(&self) -> Option<FibonacciResponse> {
        lock(&self.state).cached
    }

    pub fn current_n(&self) -> Option<i64> {
        lock(&self.state).n
    }

    pub fn is_loading(&self) -> bool {
        lock(&self.state).in_flight
    }

    /// Computations launched so far.
    pub fn loads_started(&self) -> usize {
        self.loads_started.load(Ordering::SeqCst)
    }
}
