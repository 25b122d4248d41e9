//! Codec for all fixed-width scalar types.
//!
//! The payload is a raw little-endian array of `rows × width` bytes, so
//! encode and decode are single bulk copies of the column's backing
//! buffer. This is the zero-copy fast path the numeric types rely on for
//! large columns; per-value work happens only in builders and `get`.

use super::{
    Codec,
    DecodeState,
};
use crate::binary::{
    Reader,
    Writer,
};
use crate::column::{
    Column,
    ScalarColumn,
    ScalarKind,
};
use crate::types::Type;
use crate::value::Value;
use crate::{
    Error,
    Result,
};

pub(crate) struct ScalarCodec {
    ty: Type,
    kind: ScalarKind,
}

impl ScalarCodec {
    pub(crate) fn new(ty: Type) -> Result<Self> {
        let kind = ScalarKind::from_type(&ty)
            .ok_or_else(|| Error::UnknownType(ty.name()))?;
        Ok(Self { ty, kind })
    }
}

impl Codec for ScalarCodec {
    fn data_type(&self) -> &Type {
        &self.ty
    }

    fn zero_value(&self) -> Value {
        self.kind.zero_value()
    }

    fn estimate_size(&self, rows: usize) -> usize {
        rows * self.kind.width()
    }

    fn encode(&self, col: &Column, w: &mut Writer) -> Result<()> {
        match col {
            Column::Scalar(col) if col.kind() == &self.kind => {
                w.write_bytes(col.raw());
                Ok(())
            }
            other => Err(Error::TypeMismatch {
                expected: self.ty.name(),
                actual: other.kind_name().to_string(),
            }),
        }
    }

    fn decode_dense(
        &self,
        r: &mut Reader<'_>,
        rows: usize,
        _state: &mut DecodeState<'_>,
    ) -> Result<Column> {
        let raw = r.read_slice(rows * self.kind.width())?.to_vec();
        Ok(Column::Scalar(ScalarColumn::from_raw(self.kind.clone(), raw)?))
    }

    fn from_values(&self, values: &[Value]) -> Result<Column> {
        let mut col = ScalarColumn::with_capacity(self.kind.clone(), values.len());
        for value in values {
            col.push(value)?;
        }
        Ok(Column::Scalar(col))
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{
        DecodeOptions,
        Prefix,
        SerKind,
    };

    fn roundtrip(type_str: &str, values: Vec<Value>) -> Column {
        let codec = crate::codec::get_codec(type_str).unwrap();
        let col = codec.from_values(&values).unwrap();

        let mut w = Writer::new();
        codec.encode(&col, &mut w).unwrap();
        let buf = w.finish();

        let mut r = Reader::new(&buf);
        let mut kinds = SerKind::dense();
        let options = DecodeOptions::default();
        let mut state =
            DecodeState::new(&Prefix::Empty, &mut kinds, &options);
        let decoded =
            codec.decode_dense(&mut r, values.len(), &mut state).unwrap();
        assert_eq!(r.remaining(), 0, "payload fully consumed");
        assert_eq!(decoded.materialize(), values);
        decoded
    }

    #[test]
    fn test_numeric_roundtrips() {
        roundtrip(
            "UInt64",
            vec![Value::UInt(0), Value::UInt(1), Value::UInt(u64::MAX)],
        );
        roundtrip("Int32", vec![Value::Int(-1), Value::Int(i32::MAX as i64)]);
        roundtrip("Float64", vec![Value::Float(1.5), Value::Float(-0.25)]);
        roundtrip(
            "Int128",
            vec![Value::Int128(i128::MIN), Value::Int128(i128::MAX)],
        );
    }

    #[test]
    fn test_bool_bytes() {
        let codec = crate::codec::get_codec("Bool").unwrap();
        let col = codec
            .from_values(&[Value::Bool(true), Value::Bool(false)])
            .unwrap();
        let mut w = Writer::new();
        codec.encode(&col, &mut w).unwrap();
        assert_eq!(&w.finish()[..], &[1, 0]);
    }

    #[test]
    fn test_underflow_surfaces() {
        let codec = crate::codec::get_codec("UInt32").unwrap();
        let buf = [1u8, 0, 0]; // three of four bytes
        let mut r = Reader::new(&buf);
        let mut kinds = SerKind::dense();
        let options = DecodeOptions::default();
        let mut state =
            DecodeState::new(&Prefix::Empty, &mut kinds, &options);
        assert!(matches!(
            codec.decode_dense(&mut r, 1, &mut state),
            Err(Error::BufferUnderflow { .. })
        ));
    }

    #[test]
    fn test_zero_rows_empty_payload() {
        let codec = crate::codec::get_codec("UInt32").unwrap();
        let col = codec.from_values(&[]).unwrap();
        let mut w = Writer::new();
        codec.encode(&col, &mut w).unwrap();
        assert!(w.is_empty());
    }
}
