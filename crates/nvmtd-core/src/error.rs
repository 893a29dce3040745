//! Error types for nvmtd-core
//!
//! Bus and device failures are reported as values; out-of-bounds requests
//! are caller defects and never appear here (see [`crate::mtd`]).

use thiserror::Error;

/// Core error type - `Copy` for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// Bus transfer failed (NACK, arbitration loss, bus error)
    #[error("bus transfer failed")]
    BusTransferFailed,
    /// Bus transaction exceeded its deadline
    #[error("bus transaction timed out")]
    BusTimeout,
    /// Device did not acknowledge within the write-cycle poll window
    #[error("write cycle did not complete in time")]
    WriteCycleTimeout,
}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
