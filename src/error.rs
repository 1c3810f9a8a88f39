//! Crate-wide error types.
//!
//! `RoutingError` only covers the synchronous failure modes of spec §7
//! (`Load`, `Validation`, `Internal`). `NoRoute`, `TimedOut` and
//! `SamplerFailure` never raise — they are recorded in a solve's
//! `diagnostics` instead, per the propagation rules in spec §7.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RoutingError {
    #[error("load error: {0}")]
    Load(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("internal invariant breach: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, RoutingError>;
