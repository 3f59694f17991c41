// Error taxonomy for stream operations
use crate::types::Interest;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StreamError {
    /// Caller misuse: zero length, oversized length, not a transport handle.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not readable")]
    NotReadable,

    #[error("not writable")]
    NotWritable,

    /// The readiness poll itself failed at the OS level.
    #[error("select failed")]
    SelectFailed(#[source] io::Error),

    /// One readiness wait window elapsed with nothing ready.
    #[error("timed out waiting for {0} readiness")]
    TimedOut(Interest),

    /// The overall read deadline elapsed before `length` bytes arrived.
    #[error("read timeout after {received}/{length} bytes")]
    ReadTimeout { received: usize, length: usize },

    #[error("connection closed by peer")]
    ConnectionClosed,

    #[error("error reading from stream")]
    ReadFailed(#[source] io::Error),

    #[error("error writing on attempt {attempt}")]
    WriteFailed {
        attempt: u32,
        #[source]
        source: io::Error,
    },

    #[error("could not write all data: wrote {written} of {total} bytes")]
    PartialWrite { written: usize, total: usize },

    #[error("error closing stream")]
    CloseFailed(#[source] io::Error),
}

/// Coarse classification of a [`StreamError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    NotReadable,
    NotWritable,
    SelectFailed,
    TimedOut,
    ConnectionClosed,
    ReadFailed,
    WriteFailed,
    PartialWrite,
    CloseFailed,
}

impl StreamError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StreamError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            StreamError::NotReadable => ErrorKind::NotReadable,
            StreamError::NotWritable => ErrorKind::NotWritable,
            StreamError::SelectFailed(_) => ErrorKind::SelectFailed,
            StreamError::TimedOut(_) | StreamError::ReadTimeout { .. } => ErrorKind::TimedOut,
            StreamError::ConnectionClosed => ErrorKind::ConnectionClosed,
            StreamError::ReadFailed(_) => ErrorKind::ReadFailed,
            StreamError::WriteFailed { .. } => ErrorKind::WriteFailed,
            StreamError::PartialWrite { .. } => ErrorKind::PartialWrite,
            StreamError::CloseFailed(_) => ErrorKind::CloseFailed,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.kind() == ErrorKind::TimedOut
    }
}

pub type Result<T> = std::result::Result<T, StreamError>;
