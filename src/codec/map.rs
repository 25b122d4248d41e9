//! Map codec.
//!
//! Same framing as Array: one cumulative pair-count offset (u64 LE) per
//! row, then the flattened key payload, then the flattened value payload.
//! Prefix and kind tree delegate to key then value.

use super::{
    array::read_offsets,
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
    MapColumn,
};
use crate::types::Type;
use crate::value::Value;
use crate::{
    Error,
    Result,
};

pub(crate) struct MapCodec {
    ty: Type,
    key: CodecRef,
    value: CodecRef,
}

impl MapCodec {
    pub(crate) fn new(ty: &Type) -> Result<Self> {
        let (key, value) = match ty {
            Type::Map { key_type, value_type } => {
                (create_codec(key_type)?, create_codec(value_type)?)
            }
            other => return Err(Error::UnknownType(other.name())),
        };
        Ok(Self { ty: ty.clone(), key, value })
    }

    fn unwrap_column<'c>(&self, col: &'c Column) -> Result<&'c MapColumn> {
        match col {
            Column::Map(col) => Ok(col),
            other => Err(Error::TypeMismatch {
                expected: self.ty.name(),
                actual: other.kind_name().to_string(),
            }),
        }
    }
}

impl Codec for MapCodec {
    fn data_type(&self) -> &Type {
        &self.ty
    }

    fn zero_value(&self) -> Value {
        Value::Map(Vec::new())
    }

    fn estimate_size(&self, rows: usize) -> usize {
        rows * 8
            + self.key.estimate_size(rows)
            + self.value.estimate_size(rows)
    }

    fn write_prefix(&self, w: &mut Writer, col: &Column) -> Result<()> {
        let col = self.unwrap_column(col)?;
        self.key.write_prefix(w, &col.keys)?;
        self.value.write_prefix(w, &col.values)
    }

    fn read_prefix(&self, r: &mut Reader<'_>) -> Result<Prefix> {
        Ok(Prefix::Children(vec![
            self.key.read_prefix(r)?,
            self.value.read_prefix(r)?,
        ]))
    }

    fn write_kinds(&self, w: &mut Writer, col: &Column) -> Result<()> {
        let col = self.unwrap_column(col)?;
        w.write_u8(SERIALIZATION_KIND_DENSE);
        self.key.write_kinds(w, &col.keys)?;
        self.value.write_kinds(w, &col.values)
    }

    fn read_kinds(
        &self,
        r: &mut Reader<'_>,
        prefix: &Prefix,
    ) -> Result<SerKind> {
        let kind = SerKind::read_kind_byte(r)?;
        let children = vec![
            self.key.read_kinds(r, prefix.child(0))?,
            self.value.read_kinds(r, prefix.child(1))?,
        ];
        Ok(SerKind { kind, children, resume: Default::default() })
    }

    fn encode(&self, col: &Column, w: &mut Writer) -> Result<()> {
        let col = self.unwrap_column(col)?;
        for &offset in &col.offsets {
            w.write_u64_le(offset);
        }
        self.key.encode(&col.keys, w)?;
        self.value.encode(&col.values, w)
    }

    fn decode_dense(
        &self,
        r: &mut Reader<'_>,
        rows: usize,
        state: &mut DecodeState<'_>,
    ) -> Result<Column> {
        let offsets = read_offsets(r, rows)?;
        let pairs = offsets.last().copied().unwrap_or(0) as usize;
        let keys = self.key.decode(r, pairs, &mut state.child(0))?;
        let values = self.value.decode(r, pairs, &mut state.child(1))?;
        Ok(Column::Map(Box::new(MapColumn {
            offsets,
            keys,
            values,
            as_pairs: state.options.map_as_array,
        })))
    }

    fn from_values(&self, values: &[Value]) -> Result<Column> {
        let mut offsets = Vec::with_capacity(values.len());
        let mut keys = Vec::new();
        let mut vals = Vec::new();
        for value in values {
            match value {
                Value::Map(pairs) => {
                    for (k, v) in pairs {
                        keys.push(k.clone());
                        vals.push(v.clone());
                    }
                }
                // The array-of-pairs materialization round-trips too.
                Value::Array(items) => {
                    for item in items {
                        match item {
                            Value::Tuple(pair) if pair.len() == 2 => {
                                keys.push(pair[0].clone());
                                vals.push(pair[1].clone());
                            }
                            other => {
                                return Err(Error::TypeMismatch {
                                    expected: "[key, value] pair"
                                        .to_string(),
                                    actual: other.kind_name().to_string(),
                                })
                            }
                        }
                    }
                }
                other => {
                    return Err(Error::TypeMismatch {
                        expected: self.ty.name(),
                        actual: other.kind_name().to_string(),
                    })
                }
            }
            offsets.push(keys.len() as u64);
        }
        Ok(Column::Map(Box::new(MapColumn {
            offsets,
            keys: self.key.from_values(&keys)?,
            values: self.value.from_values(&vals)?,
            as_pairs: false,
        })))
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
