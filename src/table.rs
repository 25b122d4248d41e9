//! Row-oriented table construction and materialization.
//!
//! These are the validating entry points in front of codec dispatch:
//! ragged rows and mismatched column lengths are rejected with the
//! offending index before any encoding happens. On the way out,
//! [`as_rows`] and [`to_array_rows`] materialize a block row-wise as plain
//! value vectors.

use crate::block::{
    Block,
    SchemaColumn,
};
use crate::codec::{
    get_codec,
    ColumnBuilder,
};
use crate::column::Column;
use crate::value::Value;
use crate::{
    Error,
    Result,
};

/// Build a block from row-oriented input.
pub fn table_from_rows(
    schema: &[SchemaColumn],
    rows: &[Vec<Value>],
) -> Result<Block> {
    let mut builder = TableBuilder::with_capacity(schema, rows.len())?;
    for row in rows {
        builder.push_row(row.clone())?;
    }
    builder.finish()
}

/// Build a block from per-column value arrays.
pub fn table_from_arrays(
    schema: &[SchemaColumn],
    arrays: &[Vec<Value>],
) -> Result<Block> {
    if arrays.len() != schema.len() {
        return Err(Error::LengthMismatch {
            what: "column arrays".to_string(),
            expected: schema.len(),
            got: arrays.len(),
        });
    }
    let rows = arrays.first().map_or(0, |a| a.len());
    for (col, array) in schema.iter().zip(arrays) {
        if array.len() != rows {
            return Err(Error::LengthMismatch {
                what: format!("column '{}'", col.name),
                expected: rows,
                got: array.len(),
            });
        }
    }

    let mut block = Block::new();
    for (col, array) in schema.iter().zip(arrays) {
        let data = get_codec(&col.ty)?.from_values(array)?;
        block.append_column(&col.name, &col.ty, data)?;
    }
    Ok(block)
}

/// Build a block from pre-built columns.
pub fn table_from_cols(
    schema: &[SchemaColumn],
    cols: Vec<Column>,
) -> Result<Block> {
    if cols.len() != schema.len() {
        return Err(Error::LengthMismatch {
            what: "columns".to_string(),
            expected: schema.len(),
            got: cols.len(),
        });
    }
    let mut block = Block::new();
    for (col, data) in schema.iter().zip(cols) {
        block.append_column(&col.name, &col.ty, data)?;
    }
    Ok(block)
}

/// Append-only row builder: push rows, then `finish` into a block.
pub struct TableBuilder {
    schema: Vec<SchemaColumn>,
    builders: Vec<ColumnBuilder>,
    rows: usize,
}

impl TableBuilder {
    /// Create a builder for the schema.
    pub fn new(schema: &[SchemaColumn]) -> Result<Self> {
        Self::with_capacity(schema, 0)
    }

    /// Create a builder with room for `rows` rows per column.
    pub fn with_capacity(
        schema: &[SchemaColumn],
        rows: usize,
    ) -> Result<Self> {
        let builders = schema
            .iter()
            .map(|col| Ok(ColumnBuilder::new(get_codec(&col.ty)?, rows)))
            .collect::<Result<_>>()?;
        Ok(Self { schema: schema.to_vec(), builders, rows: 0 })
    }

    /// Append one row; its arity must match the schema.
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.schema.len() {
            return Err(Error::LengthMismatch {
                what: format!("row {}", self.rows),
                expected: self.schema.len(),
                got: row.len(),
            });
        }
        for (builder, value) in self.builders.iter_mut().zip(row) {
            builder.append(value);
        }
        self.rows += 1;
        Ok(())
    }

    /// Number of rows pushed so far.
    pub fn len(&self) -> usize {
        self.rows
    }

    /// Whether no rows have been pushed.
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Build the immutable block.
    pub fn finish(self) -> Result<Block> {
        let mut block = Block::new();
        for (col, builder) in self.schema.iter().zip(self.builders) {
            block.append_column(&col.name, &col.ty, builder.finish()?)?;
        }
        Ok(block)
    }
}

/// Lazy row iterator over a block.
pub struct Rows<'a> {
    block: &'a Block,
    index: usize,
}

impl<'a> Iterator for Rows<'a> {
    type Item = Vec<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.block.row_count() {
            return None;
        }
        let row = self
            .block
            .columns()
            .iter()
            .map(|col| col.data.get(self.index))
            .collect();
        self.index += 1;
        Some(row)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.block.row_count() - self.index;
        (remaining, Some(remaining))
    }
}

impl<'a> ExactSizeIterator for Rows<'a> {}

/// Iterate a block row-wise; each row is a plain value vector in column
/// declaration order.
pub fn as_rows(block: &Block) -> Rows<'_> {
    Rows { block, index: 0 }
}

/// Materialize every row of a block.
pub fn to_array_rows(block: &Block) -> Vec<Vec<Value>> {
    as_rows(block).collect()
}
