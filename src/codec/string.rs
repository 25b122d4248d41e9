//! String codec: LEB128 length plus UTF-8 bytes per row.

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
    StringColumn,
};
use crate::types::Type;
use crate::value::Value;
use crate::{
    Error,
    Result,
};

pub(crate) struct StringCodec {
    ty: Type,
}

impl StringCodec {
    pub(crate) fn new() -> Self {
        Self { ty: Type::String }
    }
}

impl Codec for StringCodec {
    fn data_type(&self) -> &Type {
        &self.ty
    }

    fn zero_value(&self) -> Value {
        Value::String(String::new())
    }

    fn estimate_size(&self, rows: usize) -> usize {
        rows * 16
    }

    fn encode(&self, col: &Column, w: &mut Writer) -> Result<()> {
        match col {
            Column::String(col) => {
                for value in &col.values {
                    w.write_string(value);
                }
                Ok(())
            }
            other => Err(Error::TypeMismatch {
                expected: "String".to_string(),
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
        let mut values = Vec::with_capacity(rows);
        for _ in 0..rows {
            values.push(r.read_string()?);
        }
        Ok(Column::String(StringColumn { values }))
    }

    fn from_values(&self, values: &[Value]) -> Result<Column> {
        let mut out = Vec::with_capacity(values.len());
        for value in values {
            match value {
                Value::String(s) => out.push(s.clone()),
                Value::Bytes(b) => {
                    out.push(String::from_utf8(b.clone())?)
                }
                other => {
                    return Err(Error::TypeMismatch {
                        expected: "String".to_string(),
                        actual: other.kind_name().to_string(),
                    })
                }
            }
        }
        Ok(Column::String(StringColumn { values: out }))
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

    #[test]
    fn test_string_roundtrip() {
        let codec = crate::codec::get_codec("String").unwrap();
        let values: Vec<Value> =
            vec!["".into(), "hello".into(), "мир".into(), "🦀".into()];
        let col = codec.from_values(&values).unwrap();

        let mut w = Writer::new();
        codec.encode(&col, &mut w).unwrap();
        let buf = w.finish();

        let mut r = Reader::new(&buf);
        let mut kinds = SerKind::dense();
        let options = DecodeOptions::default();
        let mut state =
            DecodeState::new(&Prefix::Empty, &mut kinds, &options);
        let decoded = codec.decode_dense(&mut r, 4, &mut state).unwrap();
        assert_eq!(decoded.materialize(), values);
    }

    #[test]
    fn test_wire_layout() {
        let codec = crate::codec::get_codec("String").unwrap();
        let col = codec.from_values(&["ab".into()]).unwrap();
        let mut w = Writer::new();
        codec.encode(&col, &mut w).unwrap();
        assert_eq!(&w.finish()[..], &[0x02, b'a', b'b']);
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let codec = crate::codec::get_codec("String").unwrap();
        let mut w = Writer::new();
        w.write_varint(2);
        w.write_bytes(&[0xFF, 0xFE]);
        let buf = w.finish();

        let mut r = Reader::new(&buf);
        let mut kinds = SerKind::dense();
        let options = DecodeOptions::default();
        let mut state =
            DecodeState::new(&Prefix::Empty, &mut kinds, &options);
        assert!(codec.decode_dense(&mut r, 1, &mut state).is_err());
    }
}
