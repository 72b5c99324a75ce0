//! Utility modules.

pub mod input;
pub mod retry;

pub use input::{parse_units, read_input, read_units};
pub use retry::{RetryConfig, RetryResult, Retryable, with_retry};
