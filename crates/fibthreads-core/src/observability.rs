use serde::{Deserialize, Serialize};

/// Point-in-time view of the dispatcher's work.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolCounts {
    /// Pool jobs waiting for a worker.
    pub queued: usize,
    /// Pool jobs running right now.
    pub active: usize,
    /// Requests accepted but not yet delivered (all async strategies).
    pub outstanding: usize,
    pub pool_size: usize,
}
