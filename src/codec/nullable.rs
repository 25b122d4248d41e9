//! Nullable codec.
//!
//! Payload is one null-flag byte per row (`1` = null) followed by the
//! inner payload for all rows, with a type default at each null position.
//! There is no prefix of its own; prefix and kind tree delegate to the
//! inner codec.

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
    Column,
    NullableColumn,
};
use crate::types::Type;
use crate::value::Value;
use crate::{
    Error,
    Result,
};

pub(crate) struct NullableCodec {
    ty: Type,
    inner: CodecRef,
}

impl NullableCodec {
    pub(crate) fn new(ty: &Type) -> Result<Self> {
        let inner = match ty {
            Type::Nullable { nested_type } => create_codec(nested_type)?,
            other => return Err(Error::UnknownType(other.name())),
        };
        Ok(Self { ty: ty.clone(), inner })
    }

    fn unwrap_column<'c>(&self, col: &'c Column) -> Result<&'c NullableColumn> {
        match col {
            Column::Nullable(col) => Ok(col),
            other => Err(Error::TypeMismatch {
                expected: self.ty.name(),
                actual: other.kind_name().to_string(),
            }),
        }
    }
}

impl Codec for NullableCodec {
    fn data_type(&self) -> &Type {
        &self.ty
    }

    fn zero_value(&self) -> Value {
        Value::Null
    }

    fn estimate_size(&self, rows: usize) -> usize {
        rows + self.inner.estimate_size(rows)
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
        w.write_bytes(&col.nulls);
        self.inner.encode(&col.inner, w)
    }

    fn decode_dense(
        &self,
        r: &mut Reader<'_>,
        rows: usize,
        state: &mut DecodeState<'_>,
    ) -> Result<Column> {
        let nulls = r.read_bytes(rows)?;
        let inner = self.inner.decode(r, rows, &mut state.child(0))?;
        Ok(Column::Nullable(Box::new(NullableColumn { nulls, inner })))
    }

    fn from_values(&self, values: &[Value]) -> Result<Column> {
        let zero = self.inner.zero_value();
        let mut nulls = Vec::with_capacity(values.len());
        let mut inner_values = Vec::with_capacity(values.len());
        for value in values {
            if value.is_null() {
                nulls.push(1);
                inner_values.push(zero.clone());
            } else {
                nulls.push(0);
                inner_values.push(value.clone());
            }
        }
        Ok(Column::Nullable(Box::new(NullableColumn {
            nulls,
            inner: self.inner.from_values(&inner_values)?,
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

    fn decode_payload(
        codec: &CodecRef,
        buf: &[u8],
        rows: usize,
    ) -> Column {
        let mut r = Reader::new(buf);
        let mut kinds = SerKind::dense();
        let options = DecodeOptions::default();
        let mut state =
            DecodeState::new(&Prefix::Empty, &mut kinds, &options);
        let col = codec.decode_dense(&mut r, rows, &mut state).unwrap();
        assert_eq!(r.remaining(), 0);
        col
    }

    #[test]
    fn test_nullable_string_layout() {
        // Rows: "a", null, "c".
        let codec = get_codec("Nullable(String)").unwrap();
        let values =
            vec!["a".into(), Value::Null, "c".into()];
        let col = codec.from_values(&values).unwrap();

        let mut w = Writer::new();
        codec.encode(&col, &mut w).unwrap();
        let buf = w.finish();
        assert_eq!(
            &buf[..],
            &[0x00, 0x01, 0x00, 0x01, b'a', 0x00, 0x01, b'c']
        );

        let decoded = decode_payload(&codec, &buf, 3);
        assert_eq!(decoded.get(1), Value::Null);
        assert_eq!(decoded.materialize(), values);
    }

    #[test]
    fn test_null_positions_hold_zero_placeholder() {
        let codec = get_codec("Nullable(UInt32)").unwrap();
        let col = codec
            .from_values(&[Value::UInt(9), Value::Null])
            .unwrap();
        match &col {
            Column::Nullable(inner) => {
                assert_eq!(inner.inner.get(1), Value::UInt(0));
                assert_eq!(inner.inner.len(), 2);
            }
            other => panic!("expected nullable, got {:?}", other.kind_name()),
        }
    }
}
