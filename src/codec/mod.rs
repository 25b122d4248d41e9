//! The type-directed codec engine.
//!
//! One [`Codec`] implementation exists per data type; the factory
//! ([`create_codec`]) parses a type string into a codec tree and
//! [`get_codec`] memoizes the result in a process-wide cache. Codecs are
//! immutable after construction and shared by read-only reference; state
//! that is learned per block (the `Dynamic` type list, `JSON` paths) lives
//! in an explicit [`Prefix`] value returned by `read_prefix` and threaded
//! through `decode`, so a cached codec is always safe to share across
//! concurrent streams.
//!
//! Wire order per column: prefix, then the recursive serialization-kind
//! tree (one byte per type node), then the payload. Encoders always emit
//! Dense kinds; decoders honor Sparse by reconstructing the dense column
//! from gap-encoded non-default positions.

mod array;
mod dynamic;
mod json;
mod lowcardinality;
mod map;
mod nullable;
mod scalar;
mod string;
mod tuple;
mod variant;

pub use dynamic::DynamicCodec;
pub use variant::VariantCodec;

use crate::binary::{
    Reader,
    Writer,
};
use crate::column::Column;
use crate::types::Type;
use crate::value::Value;
use crate::{
    Error,
    Result,
};
use std::collections::HashMap;
use std::sync::{
    Arc,
    OnceLock,
    RwLock,
};

/// Reference to a codec (using Arc for cheap sharing through the cache).
pub type CodecRef = Arc<dyn Codec>;

/// Wire byte for the Dense serialization kind.
pub const SERIALIZATION_KIND_DENSE: u8 = 0;
/// Wire byte for the Sparse serialization kind.
pub const SERIALIZATION_KIND_SPARSE: u8 = 1;

/// Serialization kind of one type node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerializationKind {
    /// All rows are present in the payload.
    Dense,
    /// Only non-default rows are present; positions are gap-encoded.
    Sparse,
}

/// Resume state for sparse gap decoding, persisted per kind-tree node
/// across read windows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SparseResume {
    /// Defaults left over from the previous window.
    pub trailing_defaults: u64,
    /// Whether a non-default value immediately follows those defaults.
    pub has_value_after_defaults: bool,
}

/// One node of the per-column serialization-kind tree.
///
/// Children follow the structural order the codec declares: array to
/// inner, map to key then value, tuple to elements, nullable to inner,
/// variant/dynamic/json to each sub-codec.
#[derive(Debug, Clone)]
pub struct SerKind {
    /// The kind of this node.
    pub kind: SerializationKind,
    /// Child nodes, in structural order.
    pub children: Vec<SerKind>,
    /// Sparse resume state for this node.
    pub resume: SparseResume,
}

impl SerKind {
    /// A Dense node with no children.
    pub fn dense() -> Self {
        Self {
            kind: SerializationKind::Dense,
            children: Vec::new(),
            resume: SparseResume::default(),
        }
    }

    /// Read one kind byte.
    pub fn read_kind_byte(r: &mut Reader<'_>) -> Result<SerializationKind> {
        match r.read_u8()? {
            SERIALIZATION_KIND_DENSE => Ok(SerializationKind::Dense),
            SERIALIZATION_KIND_SPARSE => Ok(SerializationKind::Sparse),
            other => Err(Error::Protocol(format!(
                "Unknown serialization kind: {}",
                other
            ))),
        }
    }

    /// Read a leaf node (one byte, no children).
    pub fn read_leaf(r: &mut Reader<'_>) -> Result<SerKind> {
        Ok(SerKind {
            kind: Self::read_kind_byte(r)?,
            children: Vec::new(),
            resume: SparseResume::default(),
        })
    }

    /// Mutable access to child `i`, growing with Dense leaves on demand.
    pub fn child_mut(&mut self, i: usize) -> &mut SerKind {
        while self.children.len() <= i {
            self.children.push(SerKind::dense());
        }
        &mut self.children[i]
    }
}

/// Per-block learned prefix state, returned by [`Codec::read_prefix`].
///
/// Composites mirror their structure; `Dynamic` and `JSON` carry the type
/// list and path list learned from the block, keeping the codecs
/// themselves stateless.
#[derive(Default)]
pub enum Prefix {
    /// No prefix state.
    #[default]
    Empty,
    /// One child prefix per structural child.
    Children(Vec<Prefix>),
    /// Learned state of a Dynamic column.
    Dynamic(DynamicPrefix),
    /// Learned state of a JSON column.
    Json(JsonPrefix),
}

/// The per-block type list of a Dynamic column.
pub struct DynamicPrefix {
    /// Learned type strings, in wire order.
    pub type_names: Vec<String>,
    /// Codec per learned type.
    pub codecs: Vec<CodecRef>,
    /// Prefix per learned type.
    pub children: Vec<Prefix>,
}

/// The per-block path list of a JSON column.
pub struct JsonPrefix {
    /// Learned paths, in wire order.
    pub paths: Vec<String>,
    /// One [`Prefix::Dynamic`] per path.
    pub children: Vec<Prefix>,
}

static EMPTY_PREFIX: Prefix = Prefix::Empty;

impl Prefix {
    /// Child prefix `i`, or [`Prefix::Empty`] when there is none.
    pub fn child(&self, i: usize) -> &Prefix {
        match self {
            Prefix::Children(children) => {
                children.get(i).unwrap_or(&EMPTY_PREFIX)
            }
            _ => &EMPTY_PREFIX,
        }
    }
}

/// Decode-time options.
#[derive(Debug, Clone, Default)]
pub struct DecodeOptions {
    /// Materialize Map columns as arrays of `[k, v]` pairs instead of
    /// mappings, preserving duplicate keys and ordering.
    pub map_as_array: bool,
}

/// State threaded through one column's decode: the learned prefix, the
/// mutable kind-tree cursor, and the caller's options.
pub struct DecodeState<'a> {
    /// Learned prefix for the current node.
    pub prefix: &'a Prefix,
    /// Kind-tree node for the current position (holds sparse resume state).
    pub kinds: &'a mut SerKind,
    /// Decode options.
    pub options: &'a DecodeOptions,
}

impl<'a> DecodeState<'a> {
    /// Root state for one column.
    pub fn new(
        prefix: &'a Prefix,
        kinds: &'a mut SerKind,
        options: &'a DecodeOptions,
    ) -> Self {
        Self { prefix, kinds, options }
    }

    /// State for structural child `i`.
    pub fn child(&mut self, i: usize) -> DecodeState<'_> {
        DecodeState {
            prefix: self.prefix.child(i),
            kinds: self.kinds.child_mut(i),
            options: self.options,
        }
    }
}

/// The per-type encode/decode/build contract.
///
/// Implementations are stateless and shareable; everything block-specific
/// flows through the arguments.
pub trait Codec: Send + Sync {
    /// The data type this codec serializes.
    fn data_type(&self) -> &Type;

    /// The type's default value, used behind null flags and sparse fills.
    fn zero_value(&self) -> Value;

    /// Rough upper estimate of the payload size for `rows` rows, used to
    /// pre-size writers.
    fn estimate_size(&self, rows: usize) -> usize;

    /// Write the one-time per-column metadata header. Default: none.
    fn write_prefix(&self, _w: &mut Writer, _col: &Column) -> Result<()> {
        Ok(())
    }

    /// Read the per-column metadata header. Default: none.
    fn read_prefix(&self, _r: &mut Reader<'_>) -> Result<Prefix> {
        Ok(Prefix::Empty)
    }

    /// Write this node's kind byte (always Dense) and recurse into
    /// children. Default: a single leaf node.
    fn write_kinds(&self, w: &mut Writer, _col: &Column) -> Result<()> {
        w.write_u8(SERIALIZATION_KIND_DENSE);
        Ok(())
    }

    /// Read this node's kind byte and recurse into children in structural
    /// order. Default: a single leaf node.
    fn read_kinds(
        &self,
        r: &mut Reader<'_>,
        _prefix: &Prefix,
    ) -> Result<SerKind> {
        SerKind::read_leaf(r)
    }

    /// Encode the column payload (always Dense).
    fn encode(&self, col: &Column, w: &mut Writer) -> Result<()>;

    /// Decode the payload for `rows` rows, dispatching on the node's
    /// serialization kind.
    fn decode(
        &self,
        r: &mut Reader<'_>,
        rows: usize,
        state: &mut DecodeState<'_>,
    ) -> Result<Column> {
        match state.kinds.kind {
            SerializationKind::Sparse => decode_sparse(self, r, rows, state),
            SerializationKind::Dense => self.decode_dense(r, rows, state),
        }
    }

    /// Decode a dense payload for `rows` rows.
    fn decode_dense(
        &self,
        r: &mut Reader<'_>,
        rows: usize,
        state: &mut DecodeState<'_>,
    ) -> Result<Column>;

    /// Build a column from loose row values.
    fn from_values(&self, values: &[Value]) -> Result<Column>;

    /// Downcast support for codec-specific build APIs.
    fn as_any(&self) -> &dyn std::any::Any;
}

/// Gap flag terminating a sparse granule.
const END_OF_GRANULE_FLAG: u64 = 1 << 62;

/// Read the gap-encoded non-default row positions for one window of
/// `rows` rows, updating the resume state.
fn read_sparse_offsets(
    r: &mut Reader<'_>,
    rows: u64,
    st: &mut SparseResume,
) -> Result<Vec<u64>> {
    let mut positions = Vec::new();
    let mut next_row: u64 = 0;

    // Leftovers from the previous window.
    if st.trailing_defaults > 0 || st.has_value_after_defaults {
        if st.trailing_defaults >= rows {
            st.trailing_defaults -= rows;
            return Ok(positions);
        }
        next_row = st.trailing_defaults;
        st.trailing_defaults = 0;
        if st.has_value_after_defaults {
            st.has_value_after_defaults = false;
            positions.push(next_row);
            next_row += 1;
        }
    }

    while next_row < rows {
        let group = r.read_varint()?;
        let end_of_granule = group & END_OF_GRANULE_FLAG != 0;
        let gap = group & !END_OF_GRANULE_FLAG;

        if end_of_granule {
            let remaining = rows - next_row;
            if gap >= remaining {
                st.trailing_defaults = gap - remaining;
                next_row = rows;
            } else {
                next_row += gap;
            }
        } else {
            let position = next_row + gap;
            if position >= rows {
                // The value after these defaults belongs to the next
                // window.
                st.trailing_defaults = position - rows;
                st.has_value_after_defaults = true;
                next_row = rows;
            } else {
                positions.push(position);
                next_row = position + 1;
            }
        }
    }

    Ok(positions)
}

/// Sparse reconstruction: decode only the non-default values densely, then
/// scatter them over a zero-filled column of `rows` rows.
fn decode_sparse<C: Codec + ?Sized>(
    codec: &C,
    r: &mut Reader<'_>,
    rows: usize,
    state: &mut DecodeState<'_>,
) -> Result<Column> {
    let mut resume = state.kinds.resume;
    let positions = read_sparse_offsets(r, rows as u64, &mut resume)?;
    state.kinds.resume = resume;

    let dense = codec.decode_dense(r, positions.len(), state)?;

    let mut values = vec![codec.zero_value(); rows];
    for (j, &position) in positions.iter().enumerate() {
        values[position as usize] = dense.get(j);
    }
    codec.from_values(&values)
}

/// Append-only column builder over a codec.
///
/// Values accumulate row by row; `finish` validates and produces the
/// immutable column.
pub struct ColumnBuilder {
    codec: CodecRef,
    values: Vec<Value>,
}

impl ColumnBuilder {
    /// Create a builder with room for `size_hint` rows.
    pub fn new(codec: CodecRef, size_hint: usize) -> Self {
        Self { codec, values: Vec::with_capacity(size_hint) }
    }

    /// Append one row value.
    pub fn append(&mut self, value: Value) {
        self.values.push(value);
    }

    /// Number of rows appended so far.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no rows have been appended.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Build the immutable column.
    pub fn finish(self) -> Result<Column> {
        self.codec.from_values(&self.values)
    }
}

/// Construct the codec tree for a parsed type.
pub fn create_codec(ty: &Type) -> Result<CodecRef> {
    Ok(match ty {
        Type::String => Arc::new(string::StringCodec::new()),
        Type::Nullable { .. } => Arc::new(nullable::NullableCodec::new(ty)?),
        Type::Array { .. } => Arc::new(array::ArrayCodec::new(ty)?),
        Type::Map { .. } => Arc::new(map::MapCodec::new(ty)?),
        Type::Tuple { .. } => Arc::new(tuple::TupleCodec::new(ty)?),
        Type::LowCardinality { .. } => {
            Arc::new(lowcardinality::LowCardinalityCodec::new(ty)?)
        }
        Type::Variant { .. } => Arc::new(VariantCodec::new(ty)?),
        Type::Dynamic => Arc::new(DynamicCodec::new()),
        Type::Json => Arc::new(json::JsonCodec::new()),
        other => Arc::new(scalar::ScalarCodec::new(other.clone())?),
    })
}

fn codec_cache() -> &'static RwLock<HashMap<String, CodecRef>> {
    static CACHE: OnceLock<RwLock<HashMap<String, CodecRef>>> =
        OnceLock::new();
    CACHE.get_or_init(Default::default)
}

/// Resolve a codec for a type string, memoized process-wide.
pub fn get_codec(type_str: &str) -> Result<CodecRef> {
    if let Some(codec) =
        codec_cache().read().expect("codec cache poisoned").get(type_str)
    {
        return Ok(codec.clone());
    }

    let ty = Type::parse(type_str)?;
    let codec = create_codec(&ty)?;
    codec_cache()
        .write()
        .expect("codec cache poisoned")
        .entry(type_str.to_string())
        .or_insert_with(|| codec.clone());
    Ok(codec)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_cache_shares_instances() {
        let a = get_codec("Array(Nullable(String))").unwrap();
        let b = get_codec("Array(Nullable(String))").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_unknown_type_surfaces_string() {
        match get_codec("FancyType(42)") {
            Err(Error::UnknownType(s)) => assert_eq!(s, "FancyType(42)"),
            other => panic!("expected UnknownType, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_sparse_offsets_simple() {
        // Defaults: 2, value, 1 default, value, 2 trailing defaults.
        let mut w = Writer::new();
        w.write_varint(2);
        w.write_varint(1);
        w.write_varint(END_OF_GRANULE_FLAG | 2);
        let buf = w.finish();

        let mut st = SparseResume::default();
        let mut r = Reader::new(&buf);
        let positions = read_sparse_offsets(&mut r, 7, &mut st).unwrap();
        assert_eq!(positions, vec![2, 4]);
        assert_eq!(st, SparseResume::default());
    }

    #[test]
    fn test_sparse_offsets_carry_across_windows() {
        // One gap of 3 then a value at absolute row 3, read as two windows
        // of 2 rows each.
        let mut w = Writer::new();
        w.write_varint(3);
        w.write_varint(END_OF_GRANULE_FLAG);
        let buf = w.finish();

        let mut st = SparseResume::default();
        let mut r = Reader::new(&buf);
        let first = read_sparse_offsets(&mut r, 2, &mut st).unwrap();
        assert!(first.is_empty());
        assert_eq!(st.trailing_defaults, 1);
        assert!(st.has_value_after_defaults);

        let second = read_sparse_offsets(&mut r, 2, &mut st).unwrap();
        assert_eq!(second, vec![1]);
    }

    #[test]
    fn test_kind_byte_validation() {
        let buf = [7u8];
        let mut r = Reader::new(&buf);
        assert!(matches!(
            SerKind::read_leaf(&mut r),
            Err(Error::Protocol(_))
        ));
    }
}
