//! Error types for the Native format codec.
//!
//! All fallible operations in this crate return [`Result<T>`], which is an
//! alias for `std::result::Result<T, Error>`.

use thiserror::Error;

/// Errors that can occur while encoding or decoding Native format data.
#[derive(Error, Debug)]
pub enum Error {
    /// The reader ran out of bytes before the requested value was complete.
    ///
    /// In streaming contexts this means "wait for more input": the block
    /// stream catches it, buffers the partial block and retries once the
    /// next chunk arrives. Everywhere else it surfaces to the caller.
    #[error("Buffer underflow: need {needed} bytes, have {available}")]
    BufferUnderflow {
        /// Number of bytes the read required.
        needed: usize,
        /// Number of bytes that were available.
        available: usize,
    },

    /// The type factory received a type string it does not recognize.
    #[error("Unknown type: {0}")]
    UnknownType(String),

    /// A versioned prefix (LowCardinality, Variant, Dynamic, JSON) carried
    /// a serialization version this implementation does not support.
    #[error("Unsupported {what} serialization version: expected {expected}, got {got}")]
    UnsupportedVersion {
        /// Which serialization the version belongs to.
        what: &'static str,
        /// The version this implementation supports.
        expected: u64,
        /// The version found on the wire or requested by the caller.
        got: u64,
    },

    /// A Variant discriminator was outside the declared variant range.
    #[error("Invalid discriminator {got} for {variants} variant(s)")]
    InvalidDiscriminator {
        /// The offending discriminator value.
        got: u32,
        /// Number of variants the type declares.
        variants: usize,
    },

    /// Table constructors received ragged rows or columns, or a value of
    /// the wrong length for a fixed-size type.
    #[error("Length mismatch in {what}: expected {expected}, got {got}")]
    LengthMismatch {
        /// What was being validated (column name, row index, ...).
        what: String,
        /// The expected length.
        expected: usize,
        /// The length that was actually seen.
        got: usize,
    },

    /// A value or column did not match the type the codec expected.
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// The type that was expected.
        expected: String,
        /// The value or type that was received.
        actual: String,
    },

    /// Malformed wire data that is not a simple underflow, such as an
    /// out-of-range flag byte or an inconsistent embedded row count.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A feature the wire format defines but this implementation does not
    /// support, such as encoding Sparse columns.
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// An I/O error from the underlying async source or sink.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid UTF-8 was encountered when reading a string.
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// A type alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
