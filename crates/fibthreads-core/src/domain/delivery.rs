//! Delivery - 通知を届けられたかどうか

/// Outcome of a best-effort notification to the registered listener.
///
/// `ListenerAbsent` is expected while an observer is detached; it is reported
/// through `tracing` but never raised as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Delivery {
    Delivered,
    ListenerAbsent,
}

impl Delivery {
    pub fn is_delivered(self) -> bool {
        matches!(self, Delivery::Delivered)
    }
}
