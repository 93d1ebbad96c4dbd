use std::array::TryFromSliceError;

use thiserror::Error as ThisError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, ThisError, PartialEq, Eq, Clone)]
pub enum Error {
    #[error("invalid order {0}, should be at least 3")]
    InvalidOrder(usize),

    #[error("failed to compute content digest: {0}")]
    Digest(String),

    #[error("failed to deserialize: {0}")]
    FailedDeserialization(String),
}

impl Error {
    /// Builds a [`Error::Digest`] out of anything printable, for use inside
    /// [`Content::digest`](crate::prelude::Content::digest) implementations.
    pub fn digest(reason: impl std::fmt::Display) -> Self {
        Error::Digest(reason.to_string())
    }
}

impl From<hex::FromHexError> for Error {
    #[cfg_attr(coverage_nightly, coverage(off))]
    fn from(error: hex::FromHexError) -> Self {
        Error::FailedDeserialization(format!("{}", error))
    }
}

impl From<TryFromSliceError> for Error {
    #[cfg_attr(coverage_nightly, coverage(off))]
    fn from(error: TryFromSliceError) -> Self {
        Error::FailedDeserialization(format!("invalid slice format: {}", error))
    }
}
