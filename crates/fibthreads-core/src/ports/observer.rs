//! LoaderObserver port - CachedLoader から結果を受け取る側

use crate::domain::FibonacciResponse;

/// An observer that may detach and reattach to a `CachedLoader`.
pub trait LoaderObserver: Send + Sync {
    /// A result is available (fresh or cached).
    fn on_load_finished(&self, response: &FibonacciResponse);

    /// The loader's cached data was discarded.
    fn on_loader_reset(&self) {}
}
