//! Error taxonomy for the DEFLATE decoder.
//!
//! A single sum type covers every way decoding can fail. `Decoder::decode`
//! never recovers locally: the first error terminates decoding and is
//! wrapped, together with the reader's cursor and the current block index,
//! into a [`DecodeFailure`](crate::inflate::DecodeFailure).

use thiserror::Error;

/// A single decoding failure, discriminated by variant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The input was exhausted before an expected field or symbol completed.
    #[error("end of buffer")]
    EndOfBuffer,

    /// A structural violation of the DEFLATE format.
    #[error("invalid data: {0}")]
    InvalidData(&'static str),

    /// A Huffman bit path walked into an undefined node.
    #[error("unknown symbol")]
    UnknownSymbol,

    /// A code-length vector is not consistent with a prefix-free code of
    /// depth <= 15 (the node free-list was exhausted while building the
    /// tree).
    #[error("invalid huffman table")]
    InvalidTable,

    /// The output slice cannot accommodate the next emission.
    #[error("output too small")]
    OutputTooSmall,
}
