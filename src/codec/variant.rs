//! Variant codec (discriminated unions).
//!
//! Prefix is a u64 discriminator mode; only BASIC (`0`) is accepted;
//! COMPACT (`1`) is a server-internal storage mode that never reaches
//! clients. Payload is one discriminator byte per row (`0xFF` = null)
//! followed by the per-discriminator group payloads in index order; group
//! `d` holds exactly the rows tagged `d`, in row order.
//!
//! Build mode prefers explicit `(discriminator, value)` pairs via
//! [`VariantCodec::from_pairs`]; `from_values` falls back to matching each
//! value against the first structurally compatible variant type.

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
    VariantColumn,
    NULL_DISCRIMINATOR,
};
use crate::types::Type;
use crate::value::Value;
use crate::{
    Error,
    Result,
};

const MODE_BASIC: u64 = 0;
const MODE_COMPACT: u64 = 1;

/// Codec for `Variant(T0, ..., Tk-1)`.
pub struct VariantCodec {
    ty: Type,
    variants: Vec<Type>,
    children: Vec<CodecRef>,
}

impl VariantCodec {
    pub(crate) fn new(ty: &Type) -> Result<Self> {
        let variants = match ty {
            Type::Variant { variants } => variants.clone(),
            other => return Err(Error::UnknownType(other.name())),
        };
        let children = variants
            .iter()
            .map(create_codec)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { ty: ty.clone(), variants, children })
    }

    fn unwrap_column<'c>(&self, col: &'c Column) -> Result<&'c VariantColumn> {
        match col {
            Column::Variant(col)
                if col.groups.len() == self.children.len() =>
            {
                Ok(col)
            }
            other => Err(Error::TypeMismatch {
                expected: self.ty.name(),
                actual: other.kind_name().to_string(),
            }),
        }
    }

    /// Build a column from explicit `(discriminator, value)` pairs;
    /// `None` means null. This is the preferred build path: value shapes
    /// never have to be guessed.
    pub fn from_pairs(
        &self,
        pairs: &[(Option<u8>, Value)],
    ) -> Result<Column> {
        let k = self.children.len();
        let mut discriminators = Vec::with_capacity(pairs.len());
        let mut per_group: Vec<Vec<Value>> = vec![Vec::new(); k];
        for (discriminator, value) in pairs {
            match discriminator {
                None => discriminators.push(NULL_DISCRIMINATOR),
                Some(d) => {
                    if *d as usize >= k {
                        return Err(Error::InvalidDiscriminator {
                            got: *d as u32,
                            variants: k,
                        });
                    }
                    discriminators.push(*d);
                    per_group[*d as usize].push(value.clone());
                }
            }
        }
        self.build(discriminators, per_group)
    }

    fn build(
        &self,
        discriminators: Vec<u8>,
        per_group: Vec<Vec<Value>>,
    ) -> Result<Column> {
        let groups = self
            .children
            .iter()
            .zip(per_group)
            .map(|(codec, values)| codec.from_values(&values))
            .collect::<Result<Vec<_>>>()?;
        let mut col = VariantColumn {
            discriminators,
            groups,
            group_index: Vec::new(),
        };
        col.rebuild_group_index();
        Ok(Column::Variant(Box::new(col)))
    }
}

impl Codec for VariantCodec {
    fn data_type(&self) -> &Type {
        &self.ty
    }

    fn zero_value(&self) -> Value {
        Value::Null
    }

    fn estimate_size(&self, rows: usize) -> usize {
        rows + self
            .children
            .iter()
            .map(|c| c.estimate_size(rows))
            .max()
            .unwrap_or(0)
    }

    fn write_prefix(&self, w: &mut Writer, _col: &Column) -> Result<()> {
        w.write_u64_le(MODE_BASIC);
        Ok(())
    }

    fn read_prefix(&self, r: &mut Reader<'_>) -> Result<Prefix> {
        match r.read_u64_le()? {
            MODE_BASIC => Ok(Prefix::Empty),
            MODE_COMPACT => Err(Error::UnsupportedVersion {
                what: "Variant",
                expected: MODE_BASIC,
                got: MODE_COMPACT,
            }),
            other => Err(Error::Protocol(format!(
                "Unknown Variant discriminator mode: {}",
                other
            ))),
        }
    }

    fn write_kinds(&self, w: &mut Writer, col: &Column) -> Result<()> {
        let col = self.unwrap_column(col)?;
        w.write_u8(SERIALIZATION_KIND_DENSE);
        for (codec, group) in self.children.iter().zip(col.groups.iter()) {
            codec.write_kinds(w, group)?;
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
            .children
            .iter()
            .enumerate()
            .map(|(i, codec)| codec.read_kinds(r, prefix.child(i)))
            .collect::<Result<_>>()?;
        Ok(SerKind { kind, children, resume: Default::default() })
    }

    fn encode(&self, col: &Column, w: &mut Writer) -> Result<()> {
        let col = self.unwrap_column(col)?;
        w.write_bytes(&col.discriminators);
        for (codec, group) in self.children.iter().zip(col.groups.iter()) {
            codec.encode(group, w)?;
        }
        Ok(())
    }

    fn decode_dense(
        &self,
        r: &mut Reader<'_>,
        rows: usize,
        state: &mut DecodeState<'_>,
    ) -> Result<Column> {
        let k = self.children.len();
        let discriminators = r.read_bytes(rows)?;
        let mut counts = vec![0usize; k];
        for &d in &discriminators {
            if d == NULL_DISCRIMINATOR {
                continue;
            }
            if d as usize >= k {
                return Err(Error::InvalidDiscriminator {
                    got: d as u32,
                    variants: k,
                });
            }
            counts[d as usize] += 1;
        }

        let mut groups = Vec::with_capacity(k);
        for (d, codec) in self.children.iter().enumerate() {
            groups.push(codec.decode(r, counts[d], &mut state.child(d))?);
        }

        let mut col = VariantColumn {
            discriminators,
            groups,
            group_index: Vec::new(),
        };
        col.rebuild_group_index();
        Ok(Column::Variant(Box::new(col)))
    }

    /// Last-resort build path: match each value against the first
    /// structurally compatible variant type.
    fn from_values(&self, values: &[Value]) -> Result<Column> {
        let k = self.children.len();
        let mut discriminators = Vec::with_capacity(values.len());
        let mut per_group: Vec<Vec<Value>> = vec![Vec::new(); k];
        for value in values {
            if value.is_null() {
                discriminators.push(NULL_DISCRIMINATOR);
                continue;
            }
            let matched = self
                .variants
                .iter()
                .position(|ty| value_matches(ty, value))
                .ok_or_else(|| Error::TypeMismatch {
                    expected: self.ty.name(),
                    actual: format!("{} value {}", value.kind_name(), value),
                })?;
            discriminators.push(matched as u8);
            per_group[matched].push(value.clone());
        }
        self.build(discriminators, per_group)
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Structural compatibility of a loose value with a variant type.
fn value_matches(ty: &Type, v: &Value) -> bool {
    match ty {
        Type::Bool => matches!(v, Value::Bool(_)),
        Type::Int8
        | Type::Int16
        | Type::Int32
        | Type::Int64
        | Type::UInt8
        | Type::UInt16
        | Type::UInt32
        | Type::UInt64 => v.as_i64().is_some() || v.as_u64().is_some(),
        Type::Int128 | Type::UInt128 | Type::Int256 | Type::UInt256 => {
            matches!(
                v,
                Value::Int(_)
                    | Value::UInt(_)
                    | Value::Int128(_)
                    | Value::UInt128(_)
                    | Value::Int256(_)
                    | Value::UInt256(_)
            )
        }
        Type::Float32 | Type::Float64 => matches!(v, Value::Float(_)),
        Type::String | Type::FixedString { .. } => {
            matches!(v, Value::String(_) | Value::Bytes(_))
        }
        Type::Uuid => matches!(v, Value::Uuid(_)),
        Type::Ipv4 => matches!(v, Value::Ipv4(_)),
        Type::Ipv6 => matches!(v, Value::Ipv6(_)),
        Type::Date | Type::Date32 => matches!(v, Value::Date(_)),
        Type::DateTime { .. } | Type::DateTime64 { .. } => {
            matches!(v, Value::DateTime(_))
        }
        Type::Decimal { .. } => matches!(v, Value::Decimal(_)),
        Type::Enum8 { .. } | Type::Enum16 { .. } => {
            matches!(v, Value::String(_) | Value::Int(_))
        }
        Type::Nullable { nested_type } => value_matches(nested_type, v),
        Type::LowCardinality { nested_type } => value_matches(nested_type, v),
        Type::Array { .. } => matches!(v, Value::Array(_)),
        Type::Map { .. } => matches!(v, Value::Map(_)),
        Type::Tuple { elements } => {
            matches!(v, Value::Tuple(items) if items.len() == elements.len())
        }
        Type::Variant { variants } => {
            variants.iter().any(|ty| value_matches(ty, v))
        }
        Type::Dynamic | Type::Json => true,
    }
}
