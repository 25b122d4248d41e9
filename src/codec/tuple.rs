//! Tuple codec.
//!
//! Payload is the concatenation of each element codec's payload for all
//! rows, in declaration order; prefix and kind tree concatenate the same
//! way. Named tuples carry element names in the schema but use the
//! identical wire layout.

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
    TupleColumn,
};
use crate::types::Type;
use crate::value::Value;
use crate::{
    Error,
    Result,
};

pub(crate) struct TupleCodec {
    ty: Type,
    names: Vec<Option<String>>,
    elements: Vec<CodecRef>,
}

impl TupleCodec {
    pub(crate) fn new(ty: &Type) -> Result<Self> {
        let (names, elements) = match ty {
            Type::Tuple { elements } => {
                let mut names = Vec::with_capacity(elements.len());
                let mut codecs = Vec::with_capacity(elements.len());
                for element in elements {
                    names.push(element.name.clone());
                    codecs.push(create_codec(&element.ty)?);
                }
                (names, codecs)
            }
            other => return Err(Error::UnknownType(other.name())),
        };
        Ok(Self { ty: ty.clone(), names, elements })
    }

    fn unwrap_column<'c>(&self, col: &'c Column) -> Result<&'c TupleColumn> {
        match col {
            Column::Tuple(col) if col.elements.len() == self.elements.len() => {
                Ok(col)
            }
            other => Err(Error::TypeMismatch {
                expected: self.ty.name(),
                actual: other.kind_name().to_string(),
            }),
        }
    }
}

impl Codec for TupleCodec {
    fn data_type(&self) -> &Type {
        &self.ty
    }

    fn zero_value(&self) -> Value {
        Value::Tuple(self.elements.iter().map(|c| c.zero_value()).collect())
    }

    fn estimate_size(&self, rows: usize) -> usize {
        self.elements.iter().map(|c| c.estimate_size(rows)).sum()
    }

    fn write_prefix(&self, w: &mut Writer, col: &Column) -> Result<()> {
        let col = self.unwrap_column(col)?;
        for (codec, (_, element)) in
            self.elements.iter().zip(col.elements.iter())
        {
            codec.write_prefix(w, element)?;
        }
        Ok(())
    }

    fn read_prefix(&self, r: &mut Reader<'_>) -> Result<Prefix> {
        let children = self
            .elements
            .iter()
            .map(|codec| codec.read_prefix(r))
            .collect::<Result<_>>()?;
        Ok(Prefix::Children(children))
    }

    fn write_kinds(&self, w: &mut Writer, col: &Column) -> Result<()> {
        let col = self.unwrap_column(col)?;
        w.write_u8(SERIALIZATION_KIND_DENSE);
        for (codec, (_, element)) in
            self.elements.iter().zip(col.elements.iter())
        {
            codec.write_kinds(w, element)?;
        }
        Ok(())
    }

    fn read_kinds(
        &self,
        r: &mut Reader<'_>,
        prefix: &Prefix,
    ) -> Result<SerKind> {
        let kind = SerKind::read_kind_byte(r)?;
        let children = self
            .elements
            .iter()
            .enumerate()
            .map(|(i, codec)| codec.read_kinds(r, prefix.child(i)))
            .collect::<Result<_>>()?;
        Ok(SerKind { kind, children, resume: Default::default() })
    }

    fn encode(&self, col: &Column, w: &mut Writer) -> Result<()> {
        let col = self.unwrap_column(col)?;
        for (codec, (_, element)) in
            self.elements.iter().zip(col.elements.iter())
        {
            codec.encode(element, w)?;
        }
        Ok(())
    }

    fn decode_dense(
        &self,
        r: &mut Reader<'_>,
        rows: usize,
        state: &mut DecodeState<'_>,
    ) -> Result<Column> {
        let mut elements = Vec::with_capacity(self.elements.len());
        for (i, codec) in self.elements.iter().enumerate() {
            let column = codec.decode(r, rows, &mut state.child(i))?;
            elements.push((self.names[i].clone(), column));
        }
        Ok(Column::Tuple(TupleColumn { elements }))
    }

    fn from_values(&self, values: &[Value]) -> Result<Column> {
        let mut per_element: Vec<Vec<Value>> =
            vec![Vec::with_capacity(values.len()); self.elements.len()];
        for (row, value) in values.iter().enumerate() {
            match value {
                Value::Tuple(items) if items.len() == self.elements.len() => {
                    for (slot, item) in
                        per_element.iter_mut().zip(items.iter())
                    {
                        slot.push(item.clone());
                    }
                }
                Value::Tuple(items) => {
                    return Err(Error::LengthMismatch {
                        what: format!("tuple at row {}", row),
                        expected: self.elements.len(),
                        got: items.len(),
                    })
                }
                other => {
                    return Err(Error::TypeMismatch {
                        expected: self.ty.name(),
                        actual: other.kind_name().to_string(),
                    })
                }
            }
        }
        let elements = self
            .elements
            .iter()
            .zip(self.names.iter())
            .zip(per_element)
            .map(|((codec, name), values)| {
                Ok((name.clone(), codec.from_values(&values)?))
            })
            .collect::<Result<_>>()?;
        Ok(Column::Tuple(TupleColumn { elements }))
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
