use thiserror::Error;

use crate::common::CoreId;

/// Errors raised by the engine and the simulation driver.
///
/// None of these are part of normal operation: a registered core accessing
/// memory can not fail. They all signal a misconfigured run.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SimError {
    #[error("core {0} accessed memory before being registered")]
    UnregisteredCore(CoreId),
    #[error("core {0} is already registered")]
    DuplicateCore(CoreId),
    #[error("unknown protocol `{0}` (expected `MESI` or `none`)")]
    UnknownProtocol(String),
    #[error("unknown access kind `{0}` (expected `read` or `write`)")]
    UnknownAccess(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("worker for core {0} panicked")]
    WorkerPanicked(CoreId),
}

pub type Result<T> = std::result::Result<T, SimError>;
