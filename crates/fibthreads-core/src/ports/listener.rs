//! FibResultListener port - 計算結果と稼働状態の受け取り口
//!
//! UI 側（このクレートの外）が実装する。呼び出しは常に callback context 上で行われる。

use crate::domain::FibonacciResponse;

/// Receives results and activity changes from the dispatcher.
pub trait FibResultListener: Send + Sync {
    /// A computation finished.
    fn on_fib_result(&self, response: &FibonacciResponse);

    /// `true` when background work starts, `false` once it has drained.
    fn on_active_status_changed(&self, is_active: bool);
}
