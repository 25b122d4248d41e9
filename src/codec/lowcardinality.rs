//! LowCardinality codec (dictionary encoding).
//!
//! Prefix is a u64 version marker (`1`). The payload, written only when
//! the column has rows, is:
//!
//! ```text
//! [flags: u64]        HAS_ADDITIONAL_KEYS | index-width code (0=u8..3=u64)
//! [dict size: u64]
//! [dictionary]        values of the unwrapped element type
//! [row count: u64]    must equal the block row count
//! [indices]           one entry per row at the chosen width
//! ```
//!
//! When the nested type is Nullable, dictionary index 0 is reserved for
//! null and slot 0 holds a placeholder; the dictionary itself is written
//! without a null map. Encoding picks the smallest index width that can
//! address the dictionary. Decoding materializes the fully expanded plain
//! column; the dictionary form never escapes this codec.

use super::{
    create_codec,
    Codec,
    CodecRef,
    DecodeState,
    Prefix,
    SerKind,
};
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

const KEY_VERSION: u64 = 1;
const FLAG_ADDITIONAL_KEYS: u64 = 1 << 9;
const FLAG_GLOBAL_DICTIONARY: u64 = 1 << 8;
const INDEX_WIDTH_MASK: u64 = 0xFF;

pub(crate) struct LowCardinalityCodec {
    ty: Type,
    /// Codec for the nested type (possibly Nullable); decoded columns use
    /// this representation.
    inner: CodecRef,
    /// Codec for the dictionary element type, outer Nullable stripped.
    unwrapped: CodecRef,
    nullable: bool,
}

impl LowCardinalityCodec {
    pub(crate) fn new(ty: &Type) -> Result<Self> {
        let nested = match ty {
            Type::LowCardinality { nested_type } => nested_type.as_ref(),
            other => return Err(Error::UnknownType(other.name())),
        };
        let (unwrapped_ty, nullable) = match nested {
            Type::Nullable { nested_type } => (nested_type.as_ref(), true),
            other => (other, false),
        };
        Ok(Self {
            ty: ty.clone(),
            inner: create_codec(nested)?,
            unwrapped: create_codec(unwrapped_ty)?,
            nullable,
        })
    }
}

impl Codec for LowCardinalityCodec {
    fn data_type(&self) -> &Type {
        &self.ty
    }

    fn zero_value(&self) -> Value {
        self.inner.zero_value()
    }

    fn estimate_size(&self, rows: usize) -> usize {
        24 + self.unwrapped.estimate_size(rows) + rows * 4
    }

    fn write_prefix(&self, w: &mut Writer, _col: &Column) -> Result<()> {
        w.write_u64_le(KEY_VERSION);
        Ok(())
    }

    fn read_prefix(&self, r: &mut Reader<'_>) -> Result<Prefix> {
        let version = r.read_u64_le()?;
        if version != KEY_VERSION {
            return Err(Error::UnsupportedVersion {
                what: "LowCardinality",
                expected: KEY_VERSION,
                got: version,
            });
        }
        Ok(Prefix::Empty)
    }

    fn encode(&self, col: &Column, w: &mut Writer) -> Result<()> {
        let rows = col.len();
        if rows == 0 {
            return Ok(());
        }

        // First pass: dictionary with index 0 reserved for null when the
        // element type is nullable.
        let values = col.materialize();
        let mut index_of: HashMap<Vec<u8>, u64> = HashMap::new();
        let mut dictionary: Vec<Value> = Vec::new();
        if self.nullable {
            dictionary.push(self.unwrapped.zero_value());
        }
        let mut indices = Vec::with_capacity(rows);
        for value in &values {
            if value.is_null() {
                if !self.nullable {
                    return Err(Error::TypeMismatch {
                        expected: self.ty.name(),
                        actual: "Null".to_string(),
                    });
                }
                indices.push(0u64);
                continue;
            }
            let mut key = Vec::new();
            value.canonical_key(&mut key);
            let next = dictionary.len() as u64;
            let index = *index_of.entry(key).or_insert_with(|| {
                dictionary.push(value.clone());
                next
            });
            indices.push(index);
        }

        // Second pass: smallest index width that addresses the dictionary.
        let dict_size = dictionary.len() as u64;
        let (width_code, width) = if dict_size <= 256 {
            (0u64, 1usize)
        } else if dict_size <= 65536 {
            (1, 2)
        } else {
            (2, 4)
        };

        w.write_u64_le(FLAG_ADDITIONAL_KEYS | width_code);
        w.write_u64_le(dict_size);
        let dict_col = self.unwrapped.from_values(&dictionary)?;
        self.unwrapped.encode(&dict_col, w)?;
        w.write_u64_le(rows as u64);
        for index in indices {
            match width {
                1 => w.write_u8(index as u8),
                2 => w.write_u16_le(index as u16),
                _ => w.write_u32_le(index as u32),
            }
        }
        Ok(())
    }

    fn decode_dense(
        &self,
        r: &mut Reader<'_>,
        rows: usize,
        state: &mut DecodeState<'_>,
    ) -> Result<Column> {
        if rows == 0 {
            return self.inner.from_values(&[]);
        }

        let flags = r.read_u64_le()?;
        if flags & FLAG_GLOBAL_DICTIONARY != 0 {
            return Err(Error::Protocol(
                "LowCardinality global dictionaries are not supported"
                    .to_string(),
            ));
        }
        let width_code = flags & INDEX_WIDTH_MASK;

        let dict_size = r.read_u64_le()? as usize;
        let mut dict_kinds = SerKind::dense();
        let mut dict_state =
            DecodeState::new(&Prefix::Empty, &mut dict_kinds, state.options);
        let dictionary =
            self.unwrapped.decode_dense(r, dict_size, &mut dict_state)?;

        let row_count = r.read_u64_le()? as usize;
        if row_count != rows {
            return Err(Error::Protocol(format!(
                "LowCardinality row count mismatch: expected {}, got {}",
                rows, row_count
            )));
        }

        let mut values = Vec::with_capacity(rows);
        for _ in 0..rows {
            let index = match width_code {
                0 => r.read_u8()? as usize,
                1 => r.read_u16_le()? as usize,
                2 => r.read_u32_le()? as usize,
                3 => r.read_u64_le()? as usize,
                other => {
                    return Err(Error::Protocol(format!(
                        "Unknown LowCardinality index width: {}",
                        other
                    )))
                }
            };
            if index >= dict_size {
                return Err(Error::Protocol(format!(
                    "LowCardinality index {} out of range for dictionary of {}",
                    index, dict_size
                )));
            }
            if self.nullable && index == 0 {
                values.push(Value::Null);
            } else {
                values.push(dictionary.get(index));
            }
        }
        self.inner.from_values(&values)
    }

    fn from_values(&self, values: &[Value]) -> Result<Column> {
        self.inner.from_values(values)
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

    fn decode(
        codec: &CodecRef,
        buf: &[u8],
        rows: usize,
        options: &DecodeOptions,
    ) -> Column {
        let mut r = Reader::new(buf);
        let mut kinds = SerKind::dense();
        let mut state = DecodeState::new(&Prefix::Empty, &mut kinds, options);
        let col = codec.decode_dense(&mut r, rows, &mut state).unwrap();
        assert_eq!(r.remaining(), 0);
        col
    }

    #[test]
    fn test_string_dictionary_layout() {
        // Rows: "x", "y", "x", "x".
        let codec = get_codec("LowCardinality(String)").unwrap();
        let values: Vec<Value> =
            vec!["x".into(), "y".into(), "x".into(), "x".into()];
        let col = codec.from_values(&values).unwrap();

        let mut w = Writer::new();
        codec.encode(&col, &mut w).unwrap();
        let buf = w.finish();

        let mut expected = Vec::new();
        expected.extend_from_slice(&(FLAG_ADDITIONAL_KEYS).to_le_bytes());
        expected.extend_from_slice(&2u64.to_le_bytes());
        expected.extend_from_slice(&[0x01, b'x', 0x01, b'y']);
        expected.extend_from_slice(&4u64.to_le_bytes());
        expected.extend_from_slice(&[0x00, 0x01, 0x00, 0x00]);
        assert_eq!(&buf[..], &expected[..]);

        let decoded =
            decode(&codec, &buf, 4, &DecodeOptions::default());
        assert_eq!(decoded.materialize(), values);
    }

    #[test]
    fn test_prefix_version() {
        let codec = get_codec("LowCardinality(String)").unwrap();
        let col = codec.from_values(&[]).unwrap();
        let mut w = Writer::new();
        codec.write_prefix(&mut w, &col).unwrap();
        assert_eq!(&w.finish()[..], &1u64.to_le_bytes());

        let bad = 2u64.to_le_bytes();
        let mut r = Reader::new(&bad);
        assert!(matches!(
            codec.read_prefix(&mut r),
            Err(Error::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn test_empty_column_emits_no_payload() {
        let codec = get_codec("LowCardinality(String)").unwrap();
        let col = codec.from_values(&[]).unwrap();
        let mut w = Writer::new();
        codec.encode(&col, &mut w).unwrap();
        assert!(w.is_empty());
    }

    #[test]
    fn test_nullable_dictionary_reserves_slot_zero() {
        let codec = get_codec("LowCardinality(Nullable(String))").unwrap();
        let values: Vec<Value> = vec![
            "hello".into(),
            Value::Null,
            "world".into(),
            "hello".into(),
        ];
        let col = codec.from_values(&values).unwrap();

        let mut w = Writer::new();
        codec.encode(&col, &mut w).unwrap();
        let buf = w.finish();

        // Dictionary: placeholder, "hello", "world".
        let mut r = Reader::new(&buf);
        let flags = r.read_u64_le().unwrap();
        assert_eq!(flags, FLAG_ADDITIONAL_KEYS);
        assert_eq!(r.read_u64_le().unwrap(), 3);

        let decoded =
            decode(&codec, &buf, 4, &DecodeOptions::default());
        assert_eq!(decoded.materialize(), values);
    }

    #[test]
    fn test_wide_dictionary_uses_u16_indices() {
        let codec = get_codec("LowCardinality(UInt32)").unwrap();
        let values: Vec<Value> =
            (0..300).map(|i| Value::UInt(i as u64)).collect();
        let col = codec.from_values(&values).unwrap();

        let mut w = Writer::new();
        codec.encode(&col, &mut w).unwrap();
        let buf = w.finish();

        let mut r = Reader::new(&buf);
        let flags = r.read_u64_le().unwrap();
        assert_eq!(flags & INDEX_WIDTH_MASK, 1, "u16 indices expected");

        let decoded =
            decode(&codec, &buf, 300, &DecodeOptions::default());
        assert_eq!(decoded.materialize(), values);
    }

    #[test]
    fn test_row_count_mismatch_rejected() {
        let codec = get_codec("LowCardinality(String)").unwrap();
        let col = codec.from_values(&["x".into()]).unwrap();
        let mut w = Writer::new();
        codec.encode(&col, &mut w).unwrap();
        let buf = w.finish();

        let mut r = Reader::new(&buf);
        let mut kinds = SerKind::dense();
        let options = DecodeOptions::default();
        let mut state =
            DecodeState::new(&Prefix::Empty, &mut kinds, &options);
        // Ask for two rows when the embedded count says one.
        assert!(matches!(
            codec.decode_dense(&mut r, 2, &mut state),
            Err(Error::Protocol(_))
        ));
    }
}
