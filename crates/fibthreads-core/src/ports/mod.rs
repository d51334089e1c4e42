//! Ports - 外側（UI など）が実装するインターフェース
//!
//! 画面描画や入力のパースはこのクレートの外にある。外側は listener / observer を
//! 実装して結果を受け取るだけ。

pub mod listener;
pub mod observer;

pub use self::listener::FibResultListener;
pub use self::observer::LoaderObserver;
