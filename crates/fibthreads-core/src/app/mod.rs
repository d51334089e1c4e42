//! App - アプリケーション層
//!
//! # 主要コンポーネント
//! - **DispatcherBuilder**: 設定の検証と FibDispatcher の構築
//! - **FibDispatcher**: 計算リクエストの受付・実行・配送
//! - **WorkerPool**: 固定サイズのワーカープール（無制限キュー）
//! - **CallbackContext**: 通知を直列化する単一スレッドのコンテキスト
//! - **CachedLoader**: 直近の結果をキャッシュして再接続時に再配送

pub mod builder;
pub mod callback;
pub mod dispatcher;
pub mod loader;
pub mod pool;

// 主要な型を再エクスポート
pub use self::builder::{BuildError, DispatcherBuilder, DispatcherConfig};
pub use self::callback::{CallbackContext, ScheduledCallback};
pub use self::dispatcher::{FibDispatcher, ListenerToken};
pub use self::loader::{CachedLoader, LoadStart};
pub use self::pool::{PoolTask, WorkerPool};
