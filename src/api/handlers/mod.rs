//! API request handlers.

/// Query decomposition and dispatch handler.
pub mod decompose;
/// Stored paper listing handler.
pub mod papers;
/// Health/status handler.
pub mod status;
