//! Framework error type.
//!
//! Only *expected* failures are errors: bad configuration, unparseable
//! input, I/O.  Logical invariant violations (double-pushing a unique task,
//! completing an unknown request) are defects in the caller and are handled
//! with panics at the violation site, never routed through this type.

use thiserror::Error;

/// The top-level error type for `cartage-core` and a common base for
/// sub-crates.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("unknown kind name '{0}'")]
    UnknownKind(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shorthand result type for all `cartage-*` crates.
pub type CoreResult<T> = Result<T, CoreError>;
