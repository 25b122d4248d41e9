//! Block framing.
//!
//! One block on the wire is `varint(numCols) varint(numRows)` followed by,
//! per column: name string, type string, the codec's prefix, the
//! serialization-kind tree, then the payload. A zero-column, zero-row
//! header is the end-of-stream marker; consumers skip it and keep reading.

use crate::binary::{
    Reader,
    Writer,
};
use crate::codec::{
    get_codec,
    DecodeOptions,
    DecodeState,
};
use crate::column::Column;
use crate::{
    Error,
    Result,
};
use bytes::Bytes;

/// One schema element: column name plus type string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaColumn {
    /// Column name.
    pub name: String,
    /// Type string, carried verbatim on the wire.
    pub ty: String,
}

impl SchemaColumn {
    /// Create a schema element.
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self { name: name.into(), ty: ty.into() }
    }
}

/// A named, typed, decoded column inside a block.
#[derive(Debug, Clone)]
pub struct BlockColumn {
    /// Column name.
    pub name: String,
    /// Type string as carried on the wire.
    pub type_name: String,
    /// The decoded column data.
    pub data: Column,
}

/// A block is a collection of named columns with the same number of rows.
#[derive(Debug, Clone, Default)]
pub struct Block {
    columns: Vec<BlockColumn>,
    rows: usize,
}

impl Block {
    /// Create a new empty block.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a named column to the block.
    ///
    /// The type string is validated eagerly; every column must have the
    /// same number of rows as the first.
    pub fn append_column(
        &mut self,
        name: impl Into<String>,
        type_name: impl Into<String>,
        data: Column,
    ) -> Result<()> {
        let name = name.into();
        let type_name = type_name.into();
        get_codec(&type_name)?;

        if self.columns.is_empty() {
            self.rows = data.len();
        } else if data.len() != self.rows {
            return Err(Error::LengthMismatch {
                what: format!("column '{}'", name),
                expected: self.rows,
                got: data.len(),
            });
        }
        self.columns.push(BlockColumn { name, type_name, data });
        Ok(())
    }

    /// Number of columns in the block.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Number of rows in the block.
    pub fn row_count(&self) -> usize {
        self.rows
    }

    /// Whether the block holds no rows or no columns.
    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.columns.is_empty()
    }

    /// Column by index.
    pub fn column(&self, index: usize) -> Option<&BlockColumn> {
        self.columns.get(index)
    }

    /// Column by name.
    pub fn column_by_name(&self, name: &str) -> Option<&BlockColumn> {
        self.columns.iter().find(|col| col.name == name)
    }

    /// All columns, in declaration order.
    pub fn columns(&self) -> &[BlockColumn] {
        &self.columns
    }

    /// The block's schema.
    pub fn schema(&self) -> Vec<SchemaColumn> {
        self.columns
            .iter()
            .map(|col| SchemaColumn::new(&col.name, &col.type_name))
            .collect()
    }

    /// Append all rows of another block with the same schema.
    pub fn append_block(&mut self, other: &Block) -> Result<()> {
        if self.columns.is_empty() {
            *self = other.clone();
            return Ok(());
        }
        if other.columns.len() != self.columns.len() {
            return Err(Error::LengthMismatch {
                what: "block columns".to_string(),
                expected: self.columns.len(),
                got: other.columns.len(),
            });
        }
        for (mine, theirs) in
            self.columns.iter_mut().zip(other.columns.iter())
        {
            if mine.type_name != theirs.type_name {
                return Err(Error::TypeMismatch {
                    expected: mine.type_name.clone(),
                    actual: theirs.type_name.clone(),
                });
            }
            mine.data.append(&theirs.data)?;
        }
        self.rows += other.rows;
        Ok(())
    }
}

/// Encode one block.
///
/// The writer is pre-sized from the codecs' size estimates; the per-column
/// order is name, type, prefix, kind tree (always Dense), payload.
pub fn encode_block(block: &Block) -> Result<Bytes> {
    let rows = block.row_count();
    let mut codecs = Vec::with_capacity(block.column_count());
    let mut estimate = 20;
    for col in block.columns() {
        let codec = get_codec(&col.type_name)?;
        estimate += col.name.len() + col.type_name.len() + 32;
        estimate += codec.estimate_size(rows);
        codecs.push(codec);
    }

    let mut w = Writer::with_capacity(estimate);
    w.write_varint(block.column_count() as u64);
    w.write_varint(rows as u64);
    for (col, codec) in block.columns().iter().zip(codecs) {
        w.write_string(&col.name);
        w.write_string(&col.type_name);
        codec.write_prefix(&mut w, &col.data)?;
        codec.write_kinds(&mut w, &col.data)?;
        codec.encode(&col.data, &mut w)?;
    }
    tracing::trace!(
        columns = block.column_count(),
        rows,
        bytes = w.len(),
        "encoded block"
    );
    Ok(w.finish())
}

/// The zero-column, zero-row end-of-stream marker.
pub fn end_marker() -> Bytes {
    Bytes::from_static(&[0, 0])
}

/// Decode one block from the reader.
///
/// Returns `Ok(None)` for the end marker. [`Error::BufferUnderflow`]
/// means the reader holds only part of a block.
pub fn decode_block(
    r: &mut Reader<'_>,
    options: &DecodeOptions,
) -> Result<Option<Block>> {
    let num_columns = r.read_varint()? as usize;
    let num_rows = r.read_varint()? as usize;
    if num_columns == 0 && num_rows == 0 {
        return Ok(None);
    }

    let mut block = Block::new();
    block.rows = num_rows;
    for _ in 0..num_columns {
        let name = r.read_string()?;
        let type_name = r.read_string()?;
        let codec = get_codec(&type_name)?;
        tracing::trace!(column = %name, ty = %type_name, "decoding column");

        let prefix = codec.read_prefix(r)?;
        let mut kinds = codec.read_kinds(r, &prefix)?;
        let mut state = DecodeState::new(&prefix, &mut kinds, options);
        let data = codec.decode(r, num_rows, &mut state)?;
        if data.len() != num_rows {
            return Err(Error::LengthMismatch {
                what: format!("decoded column '{}'", name),
                expected: num_rows,
                got: data.len(),
            });
        }
        block.columns.push(BlockColumn { name, type_name, data });
    }
    Ok(Some(block))
}

/// Decode every block in `bytes` and merge them into one.
///
/// End markers are skipped and do not terminate the scan; multiple blocks
/// merge column-wise.
pub fn decode_all(bytes: &[u8], options: &DecodeOptions) -> Result<Block> {
    let mut r = Reader::new(bytes);
    let mut merged = Block::new();
    while r.remaining() > 0 {
        if let Some(block) = decode_block(&mut r, options)? {
            merged.append_block(&block)?;
        }
    }
    Ok(merged)
}
