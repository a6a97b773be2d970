use nom::error::{ErrorKind, ParseError};
use thiserror::Error;

use crate::linktype::Linktype;

/// The error type used by all reading and writing operations of this crate
#[derive(Debug, Error)]
pub enum PcapError {
    /// The stream is not a pcapng capture. Only raised while probing or
    /// before the first Section Header Block has been accepted.
    #[error("not a pcapng capture")]
    NotOurFormat,

    /// More data is needed to parse the current block
    #[error("incomplete data, need at least {0} more bytes")]
    Incomplete(usize),

    /// The stream ended in the middle of a block
    #[error("unexpected end of stream inside a block")]
    UnexpectedEof,

    /// A block is larger than the read buffer can be grown to
    #[error("block does not fit in the read buffer")]
    BufferTooSmall,

    /// Error from the underlying stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Structural violation of the file format
    #[error("malformed capture: {0}")]
    BadFile(String),

    /// The link type has no pcapng wire mapping
    #[error("no wire mapping for link type {0}")]
    UnsupportedEncap(Linktype),

    /// The record is larger than a reader would accept
    #[error("captured length {caplen} exceeds the maximum {max} accepted on read")]
    PacketTooLarge { caplen: u32, max: u32 },

    /// No writer is registered for this block type
    #[error("no writer registered for block type {0:#010x}")]
    UnwritableRecordType(u32),

    /// A handler registration was rejected
    #[error("registration refused: {0}")]
    Registration(&'static str),

    /// Memory for a block or option buffer could not be allocated
    #[error("out of memory")]
    OutOfMemory,

    /// Serialized output did not match the pre-computed block length
    #[error("serialized length differs from computed block length")]
    Gen,

    /// Generic parser error
    #[error("parser error: {0:?}")]
    NomError(ErrorKind),
}

impl PcapError {
    pub(crate) fn bad_file<S: Into<String>>(msg: S) -> Self {
        PcapError::BadFile(msg.into())
    }

    /// Returns true for structural violations of the file format
    pub fn is_bad_file(&self) -> bool {
        matches!(self, PcapError::BadFile(_))
    }
}

impl<I> ParseError<I> for PcapError {
    fn from_error_kind(_input: I, kind: ErrorKind) -> Self {
        PcapError::NomError(kind)
    }
    fn append(_input: I, kind: ErrorKind, _other: Self) -> Self {
        PcapError::NomError(kind)
    }
}

impl From<cookie_factory::GenError> for PcapError {
    fn from(_: cookie_factory::GenError) -> Self {
        PcapError::Gen
    }
}
