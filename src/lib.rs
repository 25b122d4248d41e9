//! # ClickHouse Native Format
//!
//! A client-side encoder/decoder for the ClickHouse Native wire format:
//! the self-describing, block-oriented, strongly-typed columnar binary
//! representation the server speaks on its native interface.
//!
//! Producers supply a schema plus row or column data and receive encoded
//! byte blocks; consumers feed a byte stream in and receive materialized
//! columnar blocks that can be iterated row-wise, indexed column-wise, or
//! re-encoded verbatim. The network transport, compression framing and
//! query protocol are deliberately out of scope: this crate is the codec
//! those layers sit on.
//!
//! # Quick Start
//!
//! ```
//! use clickhouse_native_format::{
//!     decode_all, encode_block, table_from_rows, to_array_rows,
//!     DecodeOptions, SchemaColumn, Value,
//! };
//!
//! # fn example() -> clickhouse_native_format::Result<()> {
//! let schema = vec![
//!     SchemaColumn::new("id", "UInt32"),
//!     SchemaColumn::new("name", "Nullable(String)"),
//! ];
//! let rows = vec![
//!     vec![Value::UInt(1), "alice".into()],
//!     vec![Value::UInt(2), Value::Null],
//! ];
//!
//! let block = table_from_rows(&schema, &rows)?;
//! let bytes = encode_block(&block)?;
//!
//! let decoded = decode_all(&bytes, &DecodeOptions::default())?;
//! assert_eq!(to_array_rows(&decoded), rows);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! # Modules
//!
//! - [`block`] - Block framing (`Block`, `encode_block`, `decode_block`)
//! - [`mod@column`] - Columnar containers for all supported data types
//! - [`codec`] - The type-directed codec engine and codec cache
//! - [`types`] - Type system and type-string parser
//! - [`mod@value`] - Loose row values
//! - [`io`] - Async streaming front end (`BlockStream`, `BlockSink`)
//! - [`table`] - Row-oriented table constructors and row iteration
//! - [`binary`] - Little-endian reader/writer primitives
//! - [`error`] - Error types and `Result` alias

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(missing_docs)]

/// Little-endian cursor reader and grow-on-write writer.
pub mod binary;
/// Block framing: encode/decode of whole blocks and the end marker.
pub mod block;
/// The type-directed codec engine.
pub mod codec;
/// Columnar containers.
pub mod column;
/// Error types and `Result` alias.
pub mod error;
/// 256-bit integer helpers.
pub mod int256;
/// Async streaming front end.
pub mod io;
/// Row-oriented table construction and materialization.
pub mod table;
/// The Native format type system.
pub mod types;
/// Loose row values.
pub mod value;

pub use block::{
    decode_all,
    decode_block,
    encode_block,
    end_marker,
    Block,
    BlockColumn,
    SchemaColumn,
};
pub use codec::{
    get_codec,
    Codec,
    CodecRef,
    ColumnBuilder,
    DecodeOptions,
};
pub use column::Column;
pub use error::{
    Error,
    Result,
};
pub use io::{
    BlockSink,
    BlockStream,
};
pub use table::{
    as_rows,
    table_from_arrays,
    table_from_cols,
    table_from_rows,
    to_array_rows,
    TableBuilder,
};
pub use types::Type;
pub use value::{
    Decimal,
    Value,
};
