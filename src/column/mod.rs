//! Columnar containers.
//!
//! A [`Column`] is the decoded, in-memory form of one block column. Every
//! variant satisfies the same container contract: a fixed `len` after
//! construction, `get(i)` for the logical row value, `slice(start, end)`
//! producing an independently owned sub-column with the same semantics, and
//! `materialize()` for plain row values.
//!
//! Composite containers own their children by value: a nullable column is a
//! null-flag vector plus an inner column holding type defaults at null
//! positions; arrays and maps share the flattened-plus-offsets layout;
//! variant/dynamic columns keep one monotype group per discriminator plus a
//! precomputed intra-group index per row.

mod scalar;

pub use scalar::{
    ScalarColumn,
    ScalarKind,
};

use crate::value::Value;
use crate::{
    Error,
    Result,
};

/// Discriminator byte marking a null row in a Variant column.
pub const NULL_DISCRIMINATOR: u8 = 0xFF;

/// A column of variable-length strings.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StringColumn {
    /// The row values.
    pub values: Vec<String>,
}

impl StringColumn {
    /// Create an empty string column.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the column has no rows.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Null-flag vector plus inner column.
#[derive(Debug, Clone, PartialEq)]
pub struct NullableColumn {
    /// One byte per row, `1` = null.
    pub nulls: Vec<u8>,
    /// Inner column with a type default at each null position.
    pub inner: Column,
}

impl NullableColumn {
    /// Whether the row at `index` is null.
    pub fn is_null(&self, index: usize) -> bool {
        self.nulls[index] != 0
    }
}

/// Cumulative end-offsets plus flattened inner column.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayColumn {
    /// `offsets[i]` = total inner elements up to and including row `i`.
    pub offsets: Vec<u64>,
    /// All elements of all rows, concatenated.
    pub inner: Column,
}

impl ArrayColumn {
    /// Inner element range `[start, end)` for the array at `index`.
    pub fn range(&self, index: usize) -> (usize, usize) {
        let end = self.offsets[index] as usize;
        let start =
            if index == 0 { 0 } else { self.offsets[index - 1] as usize };
        (start, end)
    }
}

/// Array-of-pairs layout for Map columns.
#[derive(Debug, Clone, PartialEq)]
pub struct MapColumn {
    /// Cumulative pair-count offsets, as in [`ArrayColumn`].
    pub offsets: Vec<u64>,
    /// Flattened keys.
    pub keys: Column,
    /// Flattened values.
    pub values: Column,
    /// When set, rows materialize as arrays of `[k, v]` pairs instead of
    /// mappings, preserving duplicate keys and ordering.
    pub as_pairs: bool,
}

impl MapColumn {
    fn range(&self, index: usize) -> (usize, usize) {
        let end = self.offsets[index] as usize;
        let start =
            if index == 0 { 0 } else { self.offsets[index - 1] as usize };
        (start, end)
    }
}

/// Parallel element columns of equal length.
#[derive(Debug, Clone, PartialEq)]
pub struct TupleColumn {
    /// `(name, column)` per element; names are set for named tuples.
    pub elements: Vec<(Option<String>, Column)>,
}

/// Discriminated union column: per-row tag plus monotype groups.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantColumn {
    /// One discriminator byte per row; [`NULL_DISCRIMINATOR`] marks null.
    pub discriminators: Vec<u8>,
    /// One group column per variant, holding exactly the rows tagged with
    /// that discriminator, in row order.
    pub groups: Vec<Column>,
    /// Precomputed index of each row within its group (0 for null rows).
    pub group_index: Vec<u32>,
}

impl VariantColumn {
    /// Recompute the per-row intra-group index from the discriminators.
    pub fn rebuild_group_index(&mut self) {
        self.group_index = intra_group_index(
            self.discriminators.iter().map(|&d| {
                if d == NULL_DISCRIMINATOR {
                    None
                } else {
                    Some(d as usize)
                }
            }),
            self.groups.len(),
        );
    }
}

/// Self-describing column: per-block learned type list plus groups.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicColumn {
    /// Ordered type strings `T0..T{k-1}` for this block.
    pub type_names: Vec<String>,
    /// One discriminator per row; the value `k` marks null.
    pub discriminators: Vec<u32>,
    /// One group column per learned type.
    pub groups: Vec<Column>,
    /// Precomputed index of each row within its group (0 for null rows).
    pub group_index: Vec<u32>,
}

impl DynamicColumn {
    /// A dynamic column of `len` nulls with no learned types.
    pub fn nulls(len: usize) -> Self {
        Self {
            type_names: Vec::new(),
            discriminators: vec![0; len],
            groups: Vec::new(),
            group_index: vec![0; len],
        }
    }

    /// The discriminator value that marks null.
    pub fn null_discriminator(&self) -> u32 {
        self.type_names.len() as u32
    }

    /// Recompute the per-row intra-group index from the discriminators.
    pub fn rebuild_group_index(&mut self) {
        let null = self.null_discriminator();
        self.group_index = intra_group_index(
            self.discriminators.iter().map(|&d| {
                if d == null {
                    None
                } else {
                    Some(d as usize)
                }
            }),
            self.groups.len(),
        );
    }

    /// Append `n` null rows.
    pub fn push_nulls(&mut self, n: usize) {
        let null = self.null_discriminator();
        self.discriminators.extend(std::iter::repeat(null).take(n));
        self.group_index.extend(std::iter::repeat(0).take(n));
    }

    /// Append another dynamic column, merging its learned type list.
    pub fn append(&mut self, other: &DynamicColumn) -> Result<()> {
        let old_null = self.null_discriminator();

        // Map other's discriminators into the merged type list.
        let mut remap = Vec::with_capacity(other.type_names.len());
        for (name, group) in
            other.type_names.iter().zip(other.groups.iter())
        {
            let target = match self
                .type_names
                .iter()
                .position(|existing| existing == name)
            {
                Some(at) => at,
                None => {
                    self.type_names.push(name.clone());
                    self.groups.push(group.slice(0, 0)?);
                    self.type_names.len() - 1
                }
            };
            self.groups[target].append(group)?;
            remap.push(target as u32);
        }

        // The null discriminator moves when the type list grows.
        let new_null = self.null_discriminator();
        if new_null != old_null {
            for d in &mut self.discriminators {
                if *d == old_null {
                    *d = new_null;
                }
            }
        }

        let other_null = other.null_discriminator();
        for &d in &other.discriminators {
            self.discriminators.push(if d == other_null {
                new_null
            } else {
                remap[d as usize]
            });
        }
        self.rebuild_group_index();
        Ok(())
    }
}

/// Path-indexed JSON column: one Dynamic column per flattened path.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonColumn {
    /// The flattened paths, in wire order.
    pub paths: Vec<String>,
    /// One column per path, each of length `len`.
    pub columns: Vec<Column>,
    /// Row count (kept explicitly for the zero-path case).
    pub len: usize,
}

/// One decoded block column.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Fixed-width scalar elements over a raw buffer.
    Scalar(ScalarColumn),
    /// Variable-length strings.
    String(StringColumn),
    /// Nullable wrapper.
    Nullable(Box<NullableColumn>),
    /// Variable-length arrays.
    Array(Box<ArrayColumn>),
    /// Key-value maps.
    Map(Box<MapColumn>),
    /// Fixed-arity tuples.
    Tuple(TupleColumn),
    /// Discriminated unions.
    Variant(Box<VariantColumn>),
    /// Self-describing dynamic values.
    Dynamic(Box<DynamicColumn>),
    /// Path-indexed JSON objects.
    Json(Box<JsonColumn>),
}

impl Column {
    /// Number of rows.
    pub fn len(&self) -> usize {
        match self {
            Column::Scalar(col) => col.len(),
            Column::String(col) => col.values.len(),
            Column::Nullable(col) => col.nulls.len(),
            Column::Array(col) => col.offsets.len(),
            Column::Map(col) => col.offsets.len(),
            Column::Tuple(col) => {
                col.elements.first().map_or(0, |(_, c)| c.len())
            }
            Column::Variant(col) => col.discriminators.len(),
            Column::Dynamic(col) => col.discriminators.len(),
            Column::Json(col) => col.len,
        }
    }

    /// Whether the column has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The logical value of row `index`.
    ///
    /// # Panics
    ///
    /// Panics when `index >= len()`.
    pub fn get(&self, index: usize) -> Value {
        match self {
            Column::Scalar(col) => col.get(index),
            Column::String(col) => {
                Value::String(col.values[index].clone())
            }
            Column::Nullable(col) => {
                if col.is_null(index) {
                    Value::Null
                } else {
                    col.inner.get(index)
                }
            }
            Column::Array(col) => {
                let (start, end) = col.range(index);
                Value::Array(
                    (start..end).map(|i| col.inner.get(i)).collect(),
                )
            }
            Column::Map(col) => {
                let (start, end) = col.range(index);
                if col.as_pairs {
                    Value::Array(
                        (start..end)
                            .map(|i| {
                                Value::Tuple(vec![
                                    col.keys.get(i),
                                    col.values.get(i),
                                ])
                            })
                            .collect(),
                    )
                } else {
                    Value::Map(
                        (start..end)
                            .map(|i| (col.keys.get(i), col.values.get(i)))
                            .collect(),
                    )
                }
            }
            Column::Tuple(col) => Value::Tuple(
                col.elements.iter().map(|(_, c)| c.get(index)).collect(),
            ),
            Column::Variant(col) => {
                let d = col.discriminators[index];
                if d == NULL_DISCRIMINATOR {
                    Value::Null
                } else {
                    col.groups[d as usize]
                        .get(col.group_index[index] as usize)
                }
            }
            Column::Dynamic(col) => {
                let d = col.discriminators[index];
                if d == col.null_discriminator() {
                    Value::Null
                } else {
                    col.groups[d as usize]
                        .get(col.group_index[index] as usize)
                }
            }
            Column::Json(col) => Value::Map(
                col.paths
                    .iter()
                    .zip(col.columns.iter())
                    .filter_map(|(path, column)| {
                        let value = column.get(index);
                        if value.is_null() {
                            None
                        } else {
                            Some((Value::String(path.clone()), value))
                        }
                    })
                    .collect(),
            ),
        }
    }

    /// A new, independently owned column over the row range `[start, end)`.
    pub fn slice(&self, start: usize, end: usize) -> Result<Column> {
        if start > end || end > self.len() {
            return Err(Error::LengthMismatch {
                what: format!("slice of {} rows", self.len()),
                expected: self.len(),
                got: end.max(start),
            });
        }
        Ok(match self {
            Column::Scalar(col) => Column::Scalar(col.slice(start, end)),
            Column::String(col) => Column::String(StringColumn {
                values: col.values[start..end].to_vec(),
            }),
            Column::Nullable(col) => {
                Column::Nullable(Box::new(NullableColumn {
                    nulls: col.nulls[start..end].to_vec(),
                    inner: col.inner.slice(start, end)?,
                }))
            }
            Column::Array(col) => {
                let base =
                    if start == 0 { 0 } else { col.offsets[start - 1] };
                let inner_end = if end == 0 {
                    0
                } else {
                    col.offsets[end - 1] as usize
                };
                Column::Array(Box::new(ArrayColumn {
                    offsets: col.offsets[start..end]
                        .iter()
                        .map(|&o| o - base)
                        .collect(),
                    inner: col.inner.slice(base as usize, inner_end)?,
                }))
            }
            Column::Map(col) => {
                let base =
                    if start == 0 { 0 } else { col.offsets[start - 1] };
                let inner_end = if end == 0 {
                    0
                } else {
                    col.offsets[end - 1] as usize
                };
                Column::Map(Box::new(MapColumn {
                    offsets: col.offsets[start..end]
                        .iter()
                        .map(|&o| o - base)
                        .collect(),
                    keys: col.keys.slice(base as usize, inner_end)?,
                    values: col.values.slice(base as usize, inner_end)?,
                    as_pairs: col.as_pairs,
                }))
            }
            Column::Tuple(col) => Column::Tuple(TupleColumn {
                elements: col
                    .elements
                    .iter()
                    .map(|(name, c)| {
                        Ok((name.clone(), c.slice(start, end)?))
                    })
                    .collect::<Result<_>>()?,
            }),
            Column::Variant(col) => {
                let discriminators =
                    col.discriminators[start..end].to_vec();
                let groups = slice_groups(
                    &col.groups,
                    &col.group_index,
                    start..end,
                    |i| {
                        let d = col.discriminators[i];
                        if d == NULL_DISCRIMINATOR {
                            None
                        } else {
                            Some(d as usize)
                        }
                    },
                )?;
                let mut sliced = VariantColumn {
                    discriminators,
                    groups,
                    group_index: Vec::new(),
                };
                sliced.rebuild_group_index();
                Column::Variant(Box::new(sliced))
            }
            Column::Dynamic(col) => {
                let null = col.null_discriminator();
                let discriminators =
                    col.discriminators[start..end].to_vec();
                let groups = slice_groups(
                    &col.groups,
                    &col.group_index,
                    start..end,
                    |i| {
                        let d = col.discriminators[i];
                        if d == null {
                            None
                        } else {
                            Some(d as usize)
                        }
                    },
                )?;
                let mut sliced = DynamicColumn {
                    type_names: col.type_names.clone(),
                    discriminators,
                    groups,
                    group_index: Vec::new(),
                };
                sliced.rebuild_group_index();
                Column::Dynamic(Box::new(sliced))
            }
            Column::Json(col) => Column::Json(Box::new(JsonColumn {
                paths: col.paths.clone(),
                columns: col
                    .columns
                    .iter()
                    .map(|c| c.slice(start, end))
                    .collect::<Result<_>>()?,
                len: end - start,
            })),
        })
    }

    /// Convert every row to an owned plain value.
    pub fn materialize(&self) -> Vec<Value> {
        (0..self.len()).map(|i| self.get(i)).collect()
    }

    /// Append all rows of a structurally compatible column.
    ///
    /// Used when merging multi-block streams; dynamic columns merge their
    /// learned type lists, JSON columns merge paths with null padding.
    pub fn append(&mut self, other: &Column) -> Result<()> {
        match (self, other) {
            (Column::Scalar(a), Column::Scalar(b)) => a.append(b),
            (Column::String(a), Column::String(b)) => {
                a.values.extend_from_slice(&b.values);
                Ok(())
            }
            (Column::Nullable(a), Column::Nullable(b)) => {
                a.nulls.extend_from_slice(&b.nulls);
                a.inner.append(&b.inner)
            }
            (Column::Array(a), Column::Array(b)) => {
                let base = a.offsets.last().copied().unwrap_or(0);
                a.offsets.extend(b.offsets.iter().map(|&o| base + o));
                a.inner.append(&b.inner)
            }
            (Column::Map(a), Column::Map(b)) => {
                let base = a.offsets.last().copied().unwrap_or(0);
                a.offsets.extend(b.offsets.iter().map(|&o| base + o));
                a.keys.append(&b.keys)?;
                a.values.append(&b.values)
            }
            (Column::Tuple(a), Column::Tuple(b)) => {
                if a.elements.len() != b.elements.len() {
                    return Err(Error::LengthMismatch {
                        what: "tuple elements".to_string(),
                        expected: a.elements.len(),
                        got: b.elements.len(),
                    });
                }
                for ((_, ac), (_, bc)) in
                    a.elements.iter_mut().zip(b.elements.iter())
                {
                    ac.append(bc)?;
                }
                Ok(())
            }
            (Column::Variant(a), Column::Variant(b)) => {
                if a.groups.len() != b.groups.len() {
                    return Err(Error::LengthMismatch {
                        what: "variant groups".to_string(),
                        expected: a.groups.len(),
                        got: b.groups.len(),
                    });
                }
                a.discriminators.extend_from_slice(&b.discriminators);
                for (ag, bg) in a.groups.iter_mut().zip(b.groups.iter()) {
                    ag.append(bg)?;
                }
                a.rebuild_group_index();
                Ok(())
            }
            (Column::Dynamic(a), Column::Dynamic(b)) => a.append(b),
            (Column::Json(a), Column::Json(b)) => {
                let old_len = a.len;
                for (path, column) in b.paths.iter().zip(b.columns.iter()) {
                    match a.paths.iter().position(|p| p == path) {
                        Some(at) => a.columns[at].append(column)?,
                        None => {
                            let mut padded =
                                DynamicColumn::nulls(old_len);
                            match column {
                                Column::Dynamic(dynamic) => {
                                    padded.append(dynamic)?
                                }
                                other => {
                                    return Err(Error::TypeMismatch {
                                        expected: "Dynamic".to_string(),
                                        actual: other
                                            .kind_name()
                                            .to_string(),
                                    })
                                }
                            }
                            a.paths.push(path.clone());
                            a.columns
                                .push(Column::Dynamic(Box::new(padded)));
                        }
                    }
                }
                a.len += b.len;
                // Paths absent from `b` get null padding.
                for (path, column) in
                    a.paths.iter().zip(a.columns.iter_mut())
                {
                    if !b.paths.contains(path) {
                        if let Column::Dynamic(dynamic) = column {
                            dynamic.push_nulls(b.len);
                        }
                    }
                }
                Ok(())
            }
            (a, b) => Err(Error::TypeMismatch {
                expected: a.kind_name().to_string(),
                actual: b.kind_name().to_string(),
            }),
        }
    }

    /// Short container name for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Column::Scalar(_) => "Scalar",
            Column::String(_) => "String",
            Column::Nullable(_) => "Nullable",
            Column::Array(_) => "Array",
            Column::Map(_) => "Map",
            Column::Tuple(_) => "Tuple",
            Column::Variant(_) => "Variant",
            Column::Dynamic(_) => "Dynamic",
            Column::Json(_) => "Json",
        }
    }
}

/// Intra-group index per row: the count of earlier rows with the same
/// discriminator.
fn intra_group_index(
    discriminators: impl Iterator<Item = Option<usize>>,
    groups: usize,
) -> Vec<u32> {
    let mut counters = vec![0u32; groups];
    discriminators
        .map(|d| match d {
            Some(d) => {
                let index = counters[d];
                counters[d] += 1;
                index
            }
            None => 0,
        })
        .collect()
}

/// Slice each group to the rows referenced by the window. Group rows follow
/// row order, so the referenced indices per group are contiguous.
fn slice_groups(
    groups: &[Column],
    group_index: &[u32],
    window: std::ops::Range<usize>,
    discriminator_of: impl Fn(usize) -> Option<usize>,
) -> Result<Vec<Column>> {
    let mut ranges: Vec<Option<(usize, usize)>> = vec![None; groups.len()];
    for i in window {
        if let Some(d) = discriminator_of(i) {
            let gi = group_index[i] as usize;
            let entry = ranges[d].get_or_insert((gi, gi));
            entry.1 = gi;
        }
    }
    groups
        .iter()
        .zip(ranges)
        .map(|(group, range)| match range {
            Some((first, last)) => group.slice(first, last + 1),
            None => group.slice(0, 0),
        })
        .collect()
}
