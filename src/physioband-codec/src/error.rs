use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("Malformed packet skipped: {0}")]
    MalformedPacket(String),
    #[error("Line exceeds {max} bytes without a newline ({pending} pending)")]
    LineTooLong { max: usize, pending: usize },
}
