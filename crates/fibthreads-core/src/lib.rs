//! fibthreads-core
//!
//! Background computation and dispatch for slow sequence computations.
//!
//! # モジュール構成
//! - **engine**: 計算本体（素朴な再帰。遅いこと自体が目的）
//! - **domain**: 結果レコード、実行戦略、配送結果、エラー
//! - **ports**: 外側が実装する listener / observer
//! - **app**: dispatcher, worker pool, callback context, cached loader, builder
//! - **logger**: バックグラウンドスレッドでファイルに追記するロガー
//! - **observability**: 稼働状況のスナップショット

pub mod app;
pub mod domain;
pub mod engine;
pub mod logger;
pub mod observability;
pub mod ports;

pub use app::{CachedLoader, DispatcherBuilder, DispatcherConfig, FibDispatcher};
pub use domain::{ComputeStrategy, Delivery, FibError, FibonacciResponse};
pub use logger::FileLogger;
pub use ports::{FibResultListener, LoaderObserver};
