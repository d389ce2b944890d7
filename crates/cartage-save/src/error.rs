use thiserror::Error;

/// Load/store failures.  All of these abort the whole operation: a save
/// file that cannot be fully reconstructed is not partially applied.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("unsupported save version {found} (supported: {supported})")]
    Version { found: u8, supported: u8 },

    #[error("encode error: {0}")]
    Encode(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("save references unknown ware kind '{0}'")]
    UnknownKind(String),

    #[error("save references unknown worker role '{0}'")]
    UnknownRole(String),

    #[error("save references unknown task '{0}'")]
    UnknownTask(String),

    #[error("save references missing object: {0}")]
    MissingObject(&'static str),
}

pub type SaveResult<T> = Result<T, SaveError>;
