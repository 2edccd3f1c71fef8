//! error type for the mdz codec

use thiserror::Error;

/// everything the codec can fail with
///
/// precision loss from the reduction stages is not an error, it is the point.
#[derive(Debug, Error)]
pub enum Error {
    /// bad block size, band range, digit count or threshold
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// unusable waveform or record
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}

/// result type for mdz stuff
pub type MdzResult<T> = Result<T, Error>;
