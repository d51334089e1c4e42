//! Domain model (result record, strategies, delivery outcome, errors).

pub mod delivery;
pub mod errors;
pub mod response;
pub mod strategy;

pub use self::delivery::Delivery;
pub use self::errors::FibError;
pub use self::response::FibonacciResponse;
pub use self::strategy::ComputeStrategy;
