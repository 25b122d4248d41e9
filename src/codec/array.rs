//! Array codec.
//!
//! Payload is one cumulative end-offset (u64 LE) per row followed by the
//! inner payload for `offsets[rows-1]` elements. `Nested(...)` columns use
//! this codec too, expanded to `Array(Tuple(...))` by the type parser.

use super::{
    create_codec,
    Codec,
    CodecRef,
    DecodeState,
    Prefix,
    SerKind,
    SERIALIZATION_KIND_DENSE,
};
use crate::binary::{
    Reader,
    Writer,
};
use crate::column::{
    ArrayColumn,
    Column,
};
use crate::types::Type;
use crate::value::Value;
use crate::{
    Error,
    Result,
};

pub(crate) struct ArrayCodec {
    ty: Type,
    inner: CodecRef,
}

impl ArrayCodec {
    pub(crate) fn new(ty: &Type) -> Result<Self> {
        let inner = match ty {
            Type::Array { item_type } => create_codec(item_type)?,
            other => return Err(Error::UnknownType(other.name())),
        };
        Ok(Self { ty: ty.clone(), inner })
    }

    fn unwrap_column<'c>(&self, col: &'c Column) -> Result<&'c ArrayColumn> {
        match col {
            Column::Array(col) => Ok(col),
            other => Err(Error::TypeMismatch {
                expected: self.ty.name(),
                actual: other.kind_name().to_string(),
            }),
        }
    }
}

/// Read `rows` cumulative end-offsets and validate monotonicity.
pub(crate) fn read_offsets(
    r: &mut Reader<'_>,
    rows: usize,
) -> Result<Vec<u64>> {
    r.ensure_available(rows * 8)?;
    let mut offsets = Vec::with_capacity(rows);
    let mut previous = 0u64;
    for _ in 0..rows {
        let offset = r.read_u64_le()?;
        if offset < previous {
            return Err(Error::Protocol(format!(
                "Array offsets not monotonic: {} after {}",
                offset, previous
            )));
        }
        offsets.push(offset);
        previous = offset;
    }
    Ok(offsets)
}

impl Codec for ArrayCodec {
    fn data_type(&self) -> &Type {
        &self.ty
    }

    fn zero_value(&self) -> Value {
        Value::Array(Vec::new())
    }

    fn estimate_size(&self, rows: usize) -> usize {
        rows * 8 + self.inner.estimate_size(rows)
    }

    fn write_prefix(&self, w: &mut Writer, col: &Column) -> Result<()> {
        self.inner.write_prefix(w, &self.unwrap_column(col)?.inner)
    }

    fn read_prefix(&self, r: &mut Reader<'_>) -> Result<Prefix> {
        Ok(Prefix::Children(vec![self.inner.read_prefix(r)?]))
    }

    fn write_kinds(&self, w: &mut Writer, col: &Column) -> Result<()> {
        w.write_u8(SERIALIZATION_KIND_DENSE);
        self.inner.write_kinds(w, &self.unwrap_column(col)?.inner)
    }

    fn read_kinds(
        &self,
        r: &mut Reader<'_>,
        prefix: &Prefix,
    ) -> Result<SerKind> {
        let kind = SerKind::read_kind_byte(r)?;
        let children = vec![self.inner.read_kinds(r, prefix.child(0))?];
        Ok(SerKind { kind, children, resume: Default::default() })
    }

    fn encode(&self, col: &Column, w: &mut Writer) -> Result<()> {
        let col = self.unwrap_column(col)?;
        for &offset in &col.offsets {
            w.write_u64_le(offset);
        }
        self.inner.encode(&col.inner, w)
    }

    fn decode_dense(
        &self,
        r: &mut Reader<'_>,
        rows: usize,
        state: &mut DecodeState<'_>,
    ) -> Result<Column> {
        let offsets = read_offsets(r, rows)?;
        let inner_rows = offsets.last().copied().unwrap_or(0) as usize;
        let inner =
            self.inner.decode(r, inner_rows, &mut state.child(0))?;
        Ok(Column::Array(Box::new(ArrayColumn { offsets, inner })))
    }

    fn from_values(&self, values: &[Value]) -> Result<Column> {
        let mut offsets = Vec::with_capacity(values.len());
        let mut flattened = Vec::new();
        for value in values {
            match value {
                Value::Array(items) => flattened.extend(items.iter().cloned()),
                other => {
                    return Err(Error::TypeMismatch {
                        expected: self.ty.name(),
                        actual: other.kind_name().to_string(),
                    })
                }
            }
            offsets.push(flattened.len() as u64);
        }
        Ok(Column::Array(Box::new(ArrayColumn {
            offsets,
            inner: self.inner.from_values(&flattened)?,
        })))
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{
        get_codec,
        DecodeOptions,
    };

    #[test]
    fn test_array_int8_layout() {
        // Rows: [1,2], [], [3].
        let codec = get_codec("Array(Int8)").unwrap();
        let values = vec![
            Value::Array(vec![Value::Int(1), Value::Int(2)]),
            Value::Array(vec![]),
            Value::Array(vec![Value::Int(3)]),
        ];
        let col = codec.from_values(&values).unwrap();

        let mut w = Writer::new();
        codec.encode(&col, &mut w).unwrap();
        let buf = w.finish();

        let mut expected = Vec::new();
        for offset in [2u64, 2, 3] {
            expected.extend_from_slice(&offset.to_le_bytes());
        }
        expected.extend_from_slice(&[1, 2, 3]);
        assert_eq!(&buf[..], &expected[..]);

        let mut r = Reader::new(&buf);
        let mut kinds = SerKind::dense();
        let options = DecodeOptions::default();
        let mut state =
            DecodeState::new(&Prefix::Empty, &mut kinds, &options);
        let decoded = codec.decode_dense(&mut r, 3, &mut state).unwrap();
        assert_eq!(decoded.materialize(), values);
        assert_eq!(decoded.get(2), Value::Array(vec![Value::Int(3)]));
    }

    #[test]
    fn test_non_monotonic_offsets_rejected() {
        let codec = get_codec("Array(Int8)").unwrap();
        let mut w = Writer::new();
        w.write_u64_le(2);
        w.write_u64_le(1);
        let buf = w.finish();

        let mut r = Reader::new(&buf);
        let mut kinds = SerKind::dense();
        let options = DecodeOptions::default();
        let mut state =
            DecodeState::new(&Prefix::Empty, &mut kinds, &options);
        assert!(matches!(
            codec.decode_dense(&mut r, 2, &mut state),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn test_nested_arrays_roundtrip() {
        let codec = get_codec("Array(Array(UInt8))").unwrap();
        let values = vec![
            Value::Array(vec![
                Value::Array(vec![Value::UInt(1)]),
                Value::Array(vec![]),
            ]),
            Value::Array(vec![Value::Array(vec![
                Value::UInt(2),
                Value::UInt(3),
            ])]),
        ];
        let col = codec.from_values(&values).unwrap();

        let mut w = Writer::new();
        codec.encode(&col, &mut w).unwrap();
        let buf = w.finish();

        let mut r = Reader::new(&buf);
        let mut kinds = SerKind::dense();
        let options = DecodeOptions::default();
        let mut state =
            DecodeState::new(&Prefix::Empty, &mut kinds, &options);
        let decoded = codec.decode_dense(&mut r, 2, &mut state).unwrap();
        assert_eq!(decoded.materialize(), values);
    }
}
