//! FibDispatcher - 計算リクエストの受付と結果の配送
//!
//! # フロー
//! 1. `submit(n, strategy)` で outstanding を +1 し、必要なら稼働状態の監視を開始
//! 2. ワーカー（専用スレッド / プール / PoolTask）で `engine::calculate(n)` を実行
//! 3. 結果を callback context に post
//! 4. callback context 上でファイルに記録 → リスナーに配送 → outstanding を -1
//!
//! 稼働状態（active / idle）は callback context 上のポーリングで検出する。
//! 結果の通知と状態の通知は同じコンテキストを通るので順序が入れ替わらない。

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};
use std::time::Duration;

use super::builder::{BuildError, DispatcherBuilder, DispatcherConfig};
use super::callback::{CallbackContext, ScheduledCallback};
use super::pool::{PoolTask, WorkerPool};
use crate::domain::{ComputeStrategy, Delivery, FibError, FibonacciResponse};
use crate::engine;
use crate::logger::FileLogger;
use crate::observability::PoolCounts;
use crate::ports::FibResultListener;

const CALLBACK_THREAD_NAME: &str = "fib-callback";
const WORKER_THREAD_NAME: &str = "fib-worker";

static GLOBAL: OnceLock<Arc<FibDispatcher>> = OnceLock::new();

/// Identifies one `register_listener` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerToken(u64);

struct ListenerSlot {
    token: ListenerToken,
    listener: Weak<dyn FibResultListener>,
}

/// State shared with workers and callbacks. Does not own the pool, so a
/// worker that drops the last reference never has to join itself.
struct DispatchCore {
    callbacks: CallbackContext,
    listener: Mutex<Option<ListenerSlot>>,
    next_token: AtomicU64,
    outstanding: AtomicUsize,
    polling: AtomicBool,
    poll_timer: Mutex<Option<ScheduledCallback>>,
    reported_active: AtomicBool,
    logger: Mutex<Option<FileLogger>>,
    log_tag: String,
    poll_interval: Duration,
}

/// Releases one unit of outstanding work when dropped, whichever path
/// (delivery, panic, rejected spawn) it is dropped on.
struct OutstandingGuard {
    core: Arc<DispatchCore>,
}

impl Drop for OutstandingGuard {
    fn drop(&mut self) {
        self.core.outstanding.fetch_sub(1, Ordering::SeqCst);
    }
}

impl DispatchCore {
    fn listener_slot(&self) -> MutexGuard<'_, Option<ListenerSlot>> {
        self.listener.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn logger_slot(&self) -> MutexGuard<'_, Option<FileLogger>> {
        self.logger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn poll_timer_slot(&self) -> MutexGuard<'_, Option<ScheduledCallback>> {
        self.poll_timer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current_listener(&self) -> Option<Arc<dyn FibResultListener>> {
        self.listener_slot()
            .as_ref()
            .and_then(|slot| slot.listener.upgrade())
    }

    fn remaining_work(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    /// Count one request and start the activity poll if nobody is polling.
    fn begin_work(self: &Arc<Self>) -> OutstandingGuard {
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        if self
            .polling
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            let core = Arc::clone(self);
            self.callbacks.post(move || {
                core.deliver_status(true);
                core.poll_progress();
            });
        }
        OutstandingGuard {
            core: Arc::clone(self),
        }
    }

    // Runs on the callback context.
    fn poll_progress(self: &Arc<Self>) {
        if self.remaining_work() > 0 {
            self.schedule_poll();
            return;
        }

        self.polling.store(false, Ordering::SeqCst);
        if self.remaining_work() > 0 {
            // a submitter slipped in between the check and the store
            if self
                .polling
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                self.schedule_poll();
            }
            return;
        }
        self.deliver_status(false);
    }

    fn schedule_poll(self: &Arc<Self>) {
        let core = Arc::clone(self);
        let timer = self
            .callbacks
            .post_delayed(self.poll_interval, move || core.poll_progress());
        *self.poll_timer_slot() = Some(timer);
    }

    /// Replace a pending poll tick with one queued right now.
    fn poll_now(self: &Arc<Self>) {
        if let Some(timer) = self.poll_timer_slot().take() {
            timer.cancel();
        }
        let core = Arc::clone(self);
        self.callbacks.post(move || core.poll_progress());
    }

    /// Hand a finished result to the callback context.
    fn post_result(self: &Arc<Self>, response: FibonacciResponse, guard: OutstandingGuard) {
        let core = Arc::clone(self);
        let posted = self.callbacks.post(move || {
            core.deliver_result(&response);
            drop(guard);
        });
        if !posted {
            tracing::warn!(n = response.n, "callback context stopped; result dropped");
        }
    }

    // Runs on the callback context.
    fn deliver_result(&self, response: &FibonacciResponse) {
        self.log_event(&self.log_tag, &response.to_string());
        let _ = self.try_deliver_result(response);
    }

    // Runs on the callback context. Only genuine transitions reach the listener.
    fn deliver_status(&self, is_active: bool) {
        if self.reported_active.swap(is_active, Ordering::SeqCst) == is_active {
            return;
        }
        let _ = self.try_deliver_status(is_active);
    }

    fn try_deliver_result(&self, response: &FibonacciResponse) -> Delivery {
        match self.current_listener() {
            Some(listener) => {
                listener.on_fib_result(response);
                Delivery::Delivered
            }
            None => {
                tracing::warn!(n = response.n, "Unable to deliver Fibonacci callback. Listener detached.");
                Delivery::ListenerAbsent
            }
        }
    }

    fn try_deliver_status(&self, is_active: bool) -> Delivery {
        match self.current_listener() {
            Some(listener) => {
                listener.on_active_status_changed(is_active);
                Delivery::Delivered
            }
            None => {
                tracing::warn!(is_active, "Unable to deliver status callback. Listener detached.");
                Delivery::ListenerAbsent
            }
        }
    }

    fn log_event(&self, tag: &str, message: &str) {
        if let Some(logger) = self.logger_slot().as_ref() {
            logger.log_message(tag, message);
        }
    }
}

/// Accepts compute requests, runs them off the caller's thread, and delivers
/// results to one registered listener on a dedicated callback thread.
pub struct FibDispatcher {
    core: Arc<DispatchCore>,
    pool: WorkerPool,
    disposed: AtomicBool,
}

impl FibDispatcher {
    /// Process-wide instance with default settings, created on first use.
    pub fn global() -> Result<Arc<FibDispatcher>, BuildError> {
        if let Some(dispatcher) = GLOBAL.get() {
            return Ok(Arc::clone(dispatcher));
        }
        let built = DispatcherBuilder::new().build()?;
        Ok(Arc::clone(GLOBAL.get_or_init(|| built)))
    }

    pub(crate) fn from_config(config: DispatcherConfig) -> Result<Arc<Self>, BuildError> {
        let logger = config
            .log_file
            .as_deref()
            .map(FileLogger::open)
            .transpose()?;
        let callbacks = CallbackContext::spawn(CALLBACK_THREAD_NAME)?;
        let pool = WorkerPool::spawn(config.pool_size, WORKER_THREAD_NAME)?;
        let poll_interval = config.poll_interval();

        tracing::info!(
            pool_size = config.pool_size,
            poll_interval_ms = config.poll_interval_ms,
            "fib dispatcher started"
        );
        Ok(Arc::new(Self {
            core: Arc::new(DispatchCore {
                callbacks,
                listener: Mutex::new(None),
                next_token: AtomicU64::new(1),
                outstanding: AtomicUsize::new(0),
                polling: AtomicBool::new(false),
                poll_timer: Mutex::new(None),
                reported_active: AtomicBool::new(false),
                logger: Mutex::new(logger),
                log_tag: config.log_tag,
                poll_interval,
            }),
            pool,
            disposed: AtomicBool::new(false),
        }))
    }

    /// Compute inline on the caller's thread.
    pub fn calculate(&self, n: i64) -> FibonacciResponse {
        engine::calculate(n)
    }

    /// Submit `n` with the given strategy.
    ///
    /// `Direct` blocks and returns the result; every other strategy returns
    /// `None` immediately and delivers through the listener later.
    pub fn submit(
        &self,
        n: i64,
        strategy: ComputeStrategy,
    ) -> Result<Option<FibonacciResponse>, FibError> {
        match strategy {
            ComputeStrategy::Direct => Ok(Some(self.calculate(n))),
            ComputeStrategy::RawThread => self.calculate_in_thread(n).map(|()| None),
            ComputeStrategy::Pooled => self.calculate_pooled(n).map(|()| None),
            ComputeStrategy::Task => self.calculate_task(n).map(|()| None),
        }
    }

    /// Compute on a new dedicated thread.
    pub fn calculate_in_thread(&self, n: i64) -> Result<(), FibError> {
        self.ensure_running()?;
        let guard = self.core.begin_work();
        let core = Arc::clone(&self.core);

        std::thread::Builder::new()
            .name(format!("fib-raw-{n}"))
            .spawn(move || {
                let response = engine::calculate(n);
                core.post_result(response, guard);
            })
            .map(drop)
            .map_err(FibError::SpawnThread)
    }

    /// Compute on the worker pool.
    pub fn calculate_pooled(&self, n: i64) -> Result<(), FibError> {
        self.ensure_running()?;
        let guard = self.core.begin_work();
        let core = Arc::clone(&self.core);

        self.pool.execute(move || {
            let response = engine::calculate(n);
            core.post_result(response, guard);
        })
    }

    /// Compute through a `PoolTask`; the callback context awaits it and
    /// delivers the result.
    pub fn calculate_task(&self, n: i64) -> Result<(), FibError> {
        self.ensure_running()?;
        let guard = self.core.begin_work();
        let task = self.compute_task(n)?;
        let core = Arc::clone(&self.core);

        self.core.callbacks.spawn_future(async move {
            match task.await {
                Some(response) => core.deliver_result(&response),
                None => tracing::warn!(n, "compute task finished without a result"),
            }
            drop(guard);
        });
        Ok(())
    }

    /// Run the engine on the pool without tracking or delivery.
    pub(crate) fn compute_task(&self, n: i64) -> Result<PoolTask<FibonacciResponse>, FibError> {
        self.pool.spawn_task(move || engine::calculate(n))
    }

    pub(crate) fn callbacks(&self) -> &CallbackContext {
        &self.core.callbacks
    }

    /// Requests accepted but not yet delivered.
    pub fn remaining_work(&self) -> usize {
        self.core.remaining_work()
    }

    pub fn is_active(&self) -> bool {
        self.remaining_work() > 0
    }

    pub fn counts(&self) -> PoolCounts {
        let (queued, active) = self.pool.load();
        PoolCounts {
            queued,
            active,
            outstanding: self.remaining_work(),
            pool_size: self.pool.size(),
        }
    }

    /// Replace the current listener (the previous one is not told). Only a
    /// weak reference is kept.
    pub fn register_listener<L>(&self, listener: &Arc<L>) -> ListenerToken
    where
        L: FibResultListener + 'static,
    {
        let token = ListenerToken(self.core.next_token.fetch_add(1, Ordering::Relaxed));
        let weak: Weak<L> = Arc::downgrade(listener);
        let listener: Weak<dyn FibResultListener> = weak;
        *self.core.listener_slot() = Some(ListenerSlot { token, listener });
        token
    }

    /// Remove the listener registered with `token`. A stale token (the
    /// listener was already replaced) leaves the current listener alone.
    pub fn unregister_listener(&self, token: ListenerToken) -> bool {
        let mut slot = self.core.listener_slot();
        if slot.as_ref().is_some_and(|current| current.token == token) {
            *slot = None;
            true
        } else {
            false
        }
    }

    pub fn clear_listener(&self) {
        *self.core.listener_slot() = None;
    }

    pub fn has_listener(&self) -> bool {
        self.core.current_listener().is_some()
    }

    /// Deliver `response` to the current listener on the caller's thread.
    pub fn try_deliver_result(&self, response: &FibonacciResponse) -> Delivery {
        self.core.try_deliver_result(response)
    }

    /// Deliver a status change to the current listener on the caller's thread.
    pub fn try_deliver_status(&self, is_active: bool) -> Delivery {
        self.core.try_deliver_status(is_active)
    }

    /// Route delivered results to `path`, or disable logging with `None` (or
    /// an empty path). Any previous log file is flushed and closed first.
    pub fn set_log_file(&self, path: Option<&Path>) -> Result<(), FibError> {
        let mut slot = self.core.logger_slot();
        if let Some(previous) = slot.take() {
            tracing::info!(path = %previous.path().display(), "closing log file");
            previous.shutdown();
        }
        if let Some(path) = path.filter(|p| !p.as_os_str().is_empty()) {
            *slot = Some(FileLogger::open(path)?);
        }
        Ok(())
    }

    pub fn is_logging(&self) -> bool {
        self.core.logger_slot().is_some()
    }

    /// Append a message to the log file, if one is configured.
    pub fn log_event(&self, tag: &str, message: &str) {
        self.core.log_event(tag, message);
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Drain the pool, run the callbacks already queued (including a final
    /// activity check in place of any pending poll tick), then close the log
    /// file. Submissions fail with `FibError::Disposed` afterwards.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!("disposing fib dispatcher");

        self.pool.shutdown_and_join();
        self.core.poll_now();
        self.core.callbacks.stop();
        if let Some(logger) = self.core.logger_slot().take() {
            logger.shutdown();
        }
    }

    fn ensure_running(&self) -> Result<(), FibError> {
        if self.is_disposed() {
            Err(FibError::Disposed)
        } else {
            Ok(())
        }
    }
}

impl Drop for FibDispatcher {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::mpsc;
    use std::time::Instant;
    use tempfile::TempDir;

    const TIMEOUT: Duration = Duration::from_secs(10);

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Result(FibonacciResponse, Option<String>),
        Active(bool),
    }

    struct RecordingListener {
        tx: Mutex<mpsc::Sender<Event>>,
    }

    impl RecordingListener {
        fn new() -> (Arc<Self>, mpsc::Receiver<Event>) {
            let (tx, rx) = mpsc::channel();
            (Arc::new(Self { tx: Mutex::new(tx) }), rx)
        }
    }

    impl FibResultListener for RecordingListener {
        fn on_fib_result(&self, response: &FibonacciResponse) {
            let thread = std::thread::current().name().map(str::to_string);
            let _ = self.tx.lock().unwrap().send(Event::Result(*response, thread));
        }

        fn on_active_status_changed(&self, is_active: bool) {
            let _ = self.tx.lock().unwrap().send(Event::Active(is_active));
        }
    }

    fn dispatcher() -> Arc<FibDispatcher> {
        DispatcherBuilder::new()
            .pool_size(4)
            .poll_interval(Duration::from_millis(10))
            .build()
            .unwrap()
    }

    /// Collect events until the dispatcher reports idle.
    fn events_until_idle(rx: &mpsc::Receiver<Event>, results: usize) -> Vec<Event> {
        let mut events = Vec::new();
        let mut seen_results = 0;
        loop {
            let event = rx.recv_timeout(TIMEOUT).unwrap();
            if matches!(event, Event::Result(..)) {
                seen_results += 1;
            }
            let idle = event == Event::Active(false);
            events.push(event);
            if idle && seen_results >= results {
                return events;
            }
        }
    }

    fn wait_for_drain(dispatcher: &FibDispatcher) {
        let deadline = Instant::now() + TIMEOUT;
        while dispatcher.is_active() {
            assert!(Instant::now() < deadline, "work never drained");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn pooled_requests_are_each_delivered_once() {
        let dispatcher = dispatcher();
        let (listener, rx) = RecordingListener::new();
        dispatcher.register_listener(&listener);

        for n in 0..12 {
            dispatcher.submit(n, ComputeStrategy::Pooled).unwrap();
        }
        let events = events_until_idle(&rx, 12);

        let mut results: Vec<FibonacciResponse> = events
            .iter()
            .filter_map(|e| match e {
                Event::Result(r, _) => Some(*r),
                Event::Active(_) => None,
            })
            .collect();
        results.sort_by_key(|r| r.n);
        assert_eq!(results.len(), 12);
        for response in &results {
            assert_eq!(response.result, engine::fib(response.n));
        }
        assert_eq!(
            results.iter().map(|r| r.n).collect::<Vec<_>>(),
            (0..12).collect::<Vec<_>>()
        );

        let statuses: Vec<bool> = events
            .iter()
            .filter_map(|e| match e {
                Event::Active(active) => Some(*active),
                Event::Result(..) => None,
            })
            .collect();
        assert_eq!(statuses.first(), Some(&true));
        assert_eq!(statuses.last(), Some(&false));
        assert!(statuses.windows(2).all(|w| w[0] != w[1]), "{statuses:?}");

        assert_eq!(dispatcher.remaining_work(), 0);
        assert!(!dispatcher.is_active());
    }

    #[rstest]
    #[case::raw_thread(ComputeStrategy::RawThread)]
    #[case::pooled(ComputeStrategy::Pooled)]
    #[case::task(ComputeStrategy::Task)]
    fn async_strategies_deliver_on_callback_thread(#[case] strategy: ComputeStrategy) {
        let dispatcher = dispatcher();
        let (listener, rx) = RecordingListener::new();
        dispatcher.register_listener(&listener);

        let returned = dispatcher.submit(15, strategy).unwrap();
        assert!(returned.is_none());

        let events = events_until_idle(&rx, 1);
        assert_eq!(events.first(), Some(&Event::Active(true)));
        let delivered = events.iter().find_map(|e| match e {
            Event::Result(r, thread) => Some((*r, thread.clone())),
            Event::Active(_) => None,
        });
        let (response, thread) = delivered.unwrap();
        assert_eq!(response.n, 15);
        assert_eq!(response.result, 610);
        assert_eq!(thread.as_deref(), Some(CALLBACK_THREAD_NAME));
    }

    #[test]
    fn direct_strategy_returns_inline() {
        let dispatcher = dispatcher();
        let (listener, rx) = RecordingListener::new();
        dispatcher.register_listener(&listener);

        let response = dispatcher.submit(10, ComputeStrategy::Direct).unwrap().unwrap();
        assert_eq!(response.result, 55);
        assert_eq!(dispatcher.remaining_work(), 0);
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[test]
    fn missing_listener_drops_results_quietly() {
        let dispatcher = dispatcher();
        for n in 0..5 {
            dispatcher.calculate_pooled(n).unwrap();
        }
        wait_for_drain(&dispatcher);

        assert!(!dispatcher.has_listener());
        let response = FibonacciResponse::new(1, 1, 0);
        assert_eq!(dispatcher.try_deliver_result(&response), Delivery::ListenerAbsent);
        assert_eq!(dispatcher.try_deliver_status(false), Delivery::ListenerAbsent);
    }

    #[test]
    fn listener_is_held_weakly() {
        let dispatcher = dispatcher();
        let (listener, _rx) = RecordingListener::new();
        dispatcher.register_listener(&listener);
        assert!(dispatcher.has_listener());

        drop(listener);
        assert!(!dispatcher.has_listener());
        assert_eq!(dispatcher.try_deliver_status(true), Delivery::ListenerAbsent);
    }

    #[test]
    fn register_replaces_and_stale_token_is_ignored() {
        let dispatcher = dispatcher();
        let (first, first_rx) = RecordingListener::new();
        let (second, second_rx) = RecordingListener::new();

        let first_token = dispatcher.register_listener(&first);
        let second_token = dispatcher.register_listener(&second);
        assert_ne!(first_token, second_token);

        assert!(!dispatcher.unregister_listener(first_token));
        assert!(dispatcher.has_listener());

        let response = FibonacciResponse::new(2, 1, 0);
        assert!(dispatcher.try_deliver_result(&response).is_delivered());
        assert!(first_rx.try_recv().is_err());
        assert!(matches!(second_rx.try_recv(), Ok(Event::Result(r, _)) if r == response));

        assert!(dispatcher.unregister_listener(second_token));
        assert!(!dispatcher.has_listener());
    }

    #[test]
    fn panicking_work_releases_outstanding_count() {
        let dispatcher = dispatcher();
        let (listener, rx) = RecordingListener::new();
        dispatcher.register_listener(&listener);

        let guard = dispatcher.core.begin_work();
        dispatcher
            .pool
            .execute(move || {
                let _guard = guard;
                panic!("unit of work failed");
            })
            .unwrap();

        assert_eq!(events_until_idle(&rx, 0), vec![Event::Active(true), Event::Active(false)]);
        assert_eq!(dispatcher.remaining_work(), 0);

        // the worker that panicked is still usable
        dispatcher.calculate_pooled(5).unwrap();
        let events = events_until_idle(&rx, 1);
        assert!(events.iter().any(|e| matches!(e, Event::Result(r, _) if r.result == 5)));
    }

    struct PanicOnFirstResult {
        panicked: AtomicBool,
        tx: Mutex<mpsc::Sender<FibonacciResponse>>,
    }

    impl FibResultListener for PanicOnFirstResult {
        fn on_fib_result(&self, response: &FibonacciResponse) {
            if !self.panicked.swap(true, Ordering::SeqCst) {
                panic!("listener failed on n={}", response.n);
            }
            let _ = self.tx.lock().unwrap().send(*response);
        }

        fn on_active_status_changed(&self, _is_active: bool) {}
    }

    #[test]
    fn panicking_listener_does_not_stop_later_deliveries() {
        let dispatcher = dispatcher();
        let (tx, rx) = mpsc::channel();
        let listener = Arc::new(PanicOnFirstResult {
            panicked: AtomicBool::new(false),
            tx: Mutex::new(tx),
        });
        dispatcher.register_listener(&listener);

        dispatcher.calculate_pooled(3).unwrap();
        wait_for_drain(&dispatcher);
        assert!(listener.panicked.load(Ordering::SeqCst));

        for n in 10..15 {
            dispatcher.calculate_pooled(n).unwrap();
        }
        let mut delivered: Vec<i64> = (0..5)
            .map(|_| rx.recv_timeout(TIMEOUT).unwrap().n)
            .collect();
        delivered.sort();
        assert_eq!(delivered, (10..15).collect::<Vec<_>>());

        wait_for_drain(&dispatcher);
        assert_eq!(dispatcher.remaining_work(), 0);
    }

    #[test]
    fn dispose_reports_idle_without_waiting_for_the_poll_tick() {
        let dispatcher = DispatcherBuilder::new()
            .pool_size(1)
            .poll_interval(Duration::from_secs(3600))
            .build()
            .unwrap();
        let (listener, rx) = RecordingListener::new();
        dispatcher.register_listener(&listener);

        dispatcher.calculate_pooled(20).unwrap();
        let started = Instant::now();
        dispatcher.dispose();

        let events = events_until_idle(&rx, 1);
        assert_eq!(events.first(), Some(&Event::Active(true)));
        assert_eq!(events.last(), Some(&Event::Active(false)));
        assert!(started.elapsed() < Duration::from_secs(60));
        assert_eq!(dispatcher.remaining_work(), 0);
    }

    #[test]
    fn delivered_results_are_logged() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fib.log");
        let dispatcher = dispatcher();
        let (listener, rx) = RecordingListener::new();
        dispatcher.register_listener(&listener);
        dispatcher.set_log_file(Some(&path)).unwrap();
        assert!(dispatcher.is_logging());

        dispatcher.calculate_pooled(10).unwrap();
        events_until_idle(&rx, 1);
        dispatcher.set_log_file(None).unwrap();
        assert!(!dispatcher.is_logging());

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 1);
        assert!(
            lines[0].starts_with("FibDispatcher: N: 10\tResult: 55 Time: "),
            "{}",
            lines[0]
        );

        // logging disabled: further events are not written
        dispatcher.log_event("Tag", "ignored");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), contents);
    }

    #[test]
    fn set_log_file_reports_open_failure() {
        let dir = TempDir::new().unwrap();
        let dispatcher = dispatcher();
        let err = dispatcher.set_log_file(Some(dir.path())).unwrap_err();
        assert!(matches!(err, FibError::OpenLogSink { .. }));
        assert!(!dispatcher.is_logging());
    }

    #[test]
    fn empty_path_disables_logging() {
        let dir = TempDir::new().unwrap();
        let dispatcher = dispatcher();
        dispatcher.set_log_file(Some(&dir.path().join("fib.log"))).unwrap();
        dispatcher.set_log_file(Some(Path::new(""))).unwrap();
        assert!(!dispatcher.is_logging());
    }

    #[test]
    fn counts_reflect_pool_configuration() {
        let dispatcher = dispatcher();
        let counts = dispatcher.counts();
        assert_eq!(
            counts,
            PoolCounts {
                queued: 0,
                active: 0,
                outstanding: 0,
                pool_size: 4,
            }
        );
    }

    #[rstest]
    #[case::raw_thread(ComputeStrategy::RawThread)]
    #[case::pooled(ComputeStrategy::Pooled)]
    #[case::task(ComputeStrategy::Task)]
    fn submit_after_dispose_fails(#[case] strategy: ComputeStrategy) {
        let dispatcher = dispatcher();
        dispatcher.dispose();
        dispatcher.dispose();
        assert!(dispatcher.is_disposed());
        assert!(matches!(dispatcher.submit(3, strategy), Err(FibError::Disposed)));
        assert_eq!(dispatcher.remaining_work(), 0);
    }

    #[test]
    fn global_instance_is_shared() {
        let a = FibDispatcher::global().unwrap();
        let b = FibDispatcher::global().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.calculate(12).result, 144);
    }
}
