use thiserror::Error;

/// Failure taxonomy shared by every decode and encode operation.
///
/// Decode-side failures are `NotFound` (no symbol located), `Format` (a symbol
/// was located but its structure is inconsistent) and `Checksum` (Reed-Solomon
/// could not repair the codewords). Encode-side failures are `Writer`.
/// `IllegalArgument` means the caller passed incoherent inputs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// No barcode was located in the input.
    #[error("no barcode found")]
    NotFound,
    /// A symbol was located but its encoded structure is inconsistent.
    #[error("malformed symbol: {0}")]
    Format(&'static str),
    /// Error correction was unable to repair the codeword stream.
    #[error("error correction failed: {0}")]
    Checksum(&'static str),
    /// An encode-side invariant failed.
    #[error("encode failed: {0}")]
    Writer(String),
    /// The caller passed incoherent inputs.
    #[error("illegal argument: {0}")]
    IllegalArgument(&'static str),
}

impl Error {
    pub(crate) fn writer(msg: impl Into<String>) -> Self {
        Error::Writer(msg.into())
    }
}
