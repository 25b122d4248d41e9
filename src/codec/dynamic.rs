//! Dynamic codec (self-describing values).
//!
//! Prefix: u64 version (`3`), varint type count `k`, `k` type strings,
//! then each learned type's own prefix. Payload: one discriminator per row
//! (8/16/32-bit depending on `k+1`) with the value `k` marking null,
//! followed by the per-type group payloads in type order.
//!
//! The learned type list is per-block state; it lives in the
//! [`Prefix::Dynamic`] value produced by `read_prefix`, never in the codec,
//! so the cached instance can serve concurrent streams.
//!
//! Build mode infers one wire type per loose value (integers to `Int64`,
//! fractions to `Float64`, booleans to `Bool`, date-likes to
//! `DateTime64(3)`, arrays to `Array(inferred)`, objects to
//! `Map(String, String)`); a value whose type would be ambiguous is
//! rejected rather than silently stringified.

use super::{
    get_codec,
    Codec,
    DecodeState,
    DynamicPrefix,
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
    DynamicColumn,
};
use crate::types::Type;
use crate::value::Value;
use crate::{
    Error,
    Result,
};
use chrono::{
    DateTime,
    Utc,
};

const DYNAMIC_VERSION: u64 = 3;

/// Codec for the `Dynamic` type.
pub struct DynamicCodec {
    ty: Type,
}

impl DynamicCodec {
    pub(crate) fn new() -> Self {
        Self { ty: Type::Dynamic }
    }

    fn unwrap_column<'c>(&self, col: &'c Column) -> Result<&'c DynamicColumn> {
        match col {
            Column::Dynamic(col) => Ok(col),
            other => Err(Error::TypeMismatch {
                expected: "Dynamic".to_string(),
                actual: other.kind_name().to_string(),
            }),
        }
    }
}

/// Discriminator width for `total` distinct values (types plus null).
fn discriminator_width(total: usize) -> usize {
    if total <= 256 {
        1
    } else if total <= 65536 {
        2
    } else {
        4
    }
}

fn read_discriminator(r: &mut Reader<'_>, width: usize) -> Result<u32> {
    Ok(match width {
        1 => r.read_u8()? as u32,
        2 => r.read_u16_le()? as u32,
        _ => r.read_u32_le()?,
    })
}

fn write_discriminator(w: &mut Writer, width: usize, d: u32) {
    match width {
        1 => w.write_u8(d as u8),
        2 => w.write_u16_le(d as u16),
        _ => w.write_u32_le(d),
    }
}

impl Codec for DynamicCodec {
    fn data_type(&self) -> &Type {
        &self.ty
    }

    fn zero_value(&self) -> Value {
        Value::Null
    }

    fn estimate_size(&self, rows: usize) -> usize {
        rows * 9
    }

    fn write_prefix(&self, w: &mut Writer, col: &Column) -> Result<()> {
        let col = self.unwrap_column(col)?;
        w.write_u64_le(DYNAMIC_VERSION);
        w.write_varint(col.type_names.len() as u64);
        for name in &col.type_names {
            w.write_string(name);
        }
        for (name, group) in col.type_names.iter().zip(col.groups.iter()) {
            get_codec(name)?.write_prefix(w, group)?;
        }
        Ok(())
    }

    fn read_prefix(&self, r: &mut Reader<'_>) -> Result<Prefix> {
        let version = r.read_u64_le()?;
        if version != DYNAMIC_VERSION {
            return Err(Error::UnsupportedVersion {
                what: "Dynamic",
                expected: DYNAMIC_VERSION,
                got: version,
            });
        }
        let count = r.read_varint()? as usize;
        let mut type_names = Vec::with_capacity(count);
        let mut codecs = Vec::with_capacity(count);
        for _ in 0..count {
            let name = r.read_string()?;
            codecs.push(get_codec(&name)?);
            type_names.push(name);
        }
        let children = codecs
            .iter()
            .map(|codec| codec.read_prefix(r))
            .collect::<Result<_>>()?;
        Ok(Prefix::Dynamic(DynamicPrefix { type_names, codecs, children }))
    }

    fn write_kinds(&self, w: &mut Writer, col: &Column) -> Result<()> {
        let col = self.unwrap_column(col)?;
        w.write_u8(SERIALIZATION_KIND_DENSE);
        for (name, group) in col.type_names.iter().zip(col.groups.iter()) {
            get_codec(name)?.write_kinds(w, group)?;
        }
        Ok(())
    }

    fn read_kinds(
        &self,
        r: &mut Reader<'_>,
        prefix: &Prefix,
    ) -> Result<SerKind> {
        let kind = SerKind::read_kind_byte(r)?;
        let children = match prefix {
            Prefix::Dynamic(dp) => dp
                .codecs
                .iter()
                .zip(dp.children.iter())
                .map(|(codec, child)| codec.read_kinds(r, child))
                .collect::<Result<_>>()?,
            _ => Vec::new(),
        };
        Ok(SerKind { kind, children, resume: Default::default() })
    }

    fn encode(&self, col: &Column, w: &mut Writer) -> Result<()> {
        let col = self.unwrap_column(col)?;
        let k = col.type_names.len();
        let width = discriminator_width(k + 1);
        for &d in &col.discriminators {
            write_discriminator(w, width, d);
        }
        for (name, group) in col.type_names.iter().zip(col.groups.iter()) {
            get_codec(name)?.encode(group, w)?;
        }
        Ok(())
    }

    fn decode_dense(
        &self,
        r: &mut Reader<'_>,
        rows: usize,
        state: &mut DecodeState<'_>,
    ) -> Result<Column> {
        let dp: &DynamicPrefix = match state.prefix {
            Prefix::Dynamic(dp) => dp,
            _ => {
                return Err(Error::Protocol(
                    "Dynamic payload without a Dynamic prefix".to_string(),
                ))
            }
        };
        let k = dp.codecs.len();
        let width = discriminator_width(k + 1);

        let mut discriminators = Vec::with_capacity(rows);
        let mut counts = vec![0usize; k];
        for _ in 0..rows {
            let d = read_discriminator(r, width)?;
            if d as usize > k {
                return Err(Error::InvalidDiscriminator {
                    got: d,
                    variants: k,
                });
            }
            if (d as usize) < k {
                counts[d as usize] += 1;
            }
            discriminators.push(d);
        }

        let mut groups = Vec::with_capacity(k);
        for (j, codec) in dp.codecs.iter().enumerate() {
            let mut child = DecodeState {
                prefix: &dp.children[j],
                kinds: state.kinds.child_mut(j),
                options: state.options,
            };
            groups.push(codec.decode(r, counts[j], &mut child)?);
        }

        let mut col = DynamicColumn {
            type_names: dp.type_names.clone(),
            discriminators,
            groups,
            group_index: Vec::new(),
        };
        col.rebuild_group_index();
        Ok(Column::Dynamic(Box::new(col)))
    }

    fn from_values(&self, values: &[Value]) -> Result<Column> {
        let mut type_names: Vec<String> = Vec::new();
        let mut per_group: Vec<Vec<Value>> = Vec::new();
        let mut inferred = Vec::with_capacity(values.len());
        for value in values {
            match infer_type_name(value)? {
                None => inferred.push(None),
                Some(name) => {
                    let slot = match type_names
                        .iter()
                        .position(|existing| *existing == name)
                    {
                        Some(at) => at,
                        None => {
                            type_names.push(name.clone());
                            per_group.push(Vec::new());
                            type_names.len() - 1
                        }
                    };
                    per_group[slot].push(coerce(&name, value));
                    inferred.push(Some(slot as u32));
                }
            }
        }

        let null = type_names.len() as u32;
        let discriminators =
            inferred.into_iter().map(|d| d.unwrap_or(null)).collect();
        let groups = type_names
            .iter()
            .zip(per_group)
            .map(|(name, values)| get_codec(name)?.from_values(&values))
            .collect::<Result<_>>()?;

        let mut col = DynamicColumn {
            type_names,
            discriminators,
            groups,
            group_index: Vec::new(),
        };
        col.rebuild_group_index();
        Ok(Column::Dynamic(Box::new(col)))
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Infer the wire type for one loose value; `None` for null.
fn infer_type_name(v: &Value) -> Result<Option<String>> {
    let ambiguous = || Error::TypeMismatch {
        expected: "a value with an unambiguous Dynamic type".to_string(),
        actual: format!("{} value {}", v.kind_name(), v),
    };
    Ok(Some(match v {
        Value::Null => return Ok(None),
        Value::Bool(_) => "Bool".to_string(),
        Value::Int(_) => "Int64".to_string(),
        Value::UInt(u) if *u <= i64::MAX as u64 => "Int64".to_string(),
        Value::Int128(i) if i64::try_from(*i).is_ok() => {
            "Int64".to_string()
        }
        Value::Float(_) => "Float64".to_string(),
        Value::Date(_) | Value::DateTime(_) => "DateTime64(3)".to_string(),
        Value::String(_) => "String".to_string(),
        Value::Map(_) => "Map(String, String)".to_string(),
        Value::Array(items) => {
            let mut element: Option<String> = None;
            let mut has_null = false;
            for item in items {
                match infer_type_name(item)? {
                    None => has_null = true,
                    Some(name) => match &element {
                        None => element = Some(name),
                        Some(existing) if *existing == name => {}
                        Some(_) => return Err(ambiguous()),
                    },
                }
            }
            let element = element.ok_or_else(ambiguous)?;
            if has_null {
                format!("Array(Nullable({}))", element)
            } else {
                format!("Array({})", element)
            }
        }
        _ => return Err(ambiguous()),
    }))
}

/// Normalize a value to the shape its inferred type's builder accepts.
fn coerce(type_name: &str, v: &Value) -> Value {
    match type_name {
        "Int64" => Value::Int(v.as_i64().unwrap_or(0)),
        "Float64" => Value::Float(v.as_f64().unwrap_or(0.0)),
        "DateTime64(3)" => match v {
            Value::Date(d) => Value::DateTime(
                DateTime::<Utc>::from_naive_utc_and_offset(
                    d.and_hms_opt(0, 0, 0).expect("midnight"),
                    Utc,
                ),
            ),
            other => other.clone(),
        },
        "Map(String, String)" => match v {
            Value::Map(pairs) => Value::Map(
                pairs
                    .iter()
                    .map(|(k, v)| {
                        (
                            Value::String(k.to_string()),
                            Value::String(v.to_string()),
                        )
                    })
                    .collect(),
            ),
            other => other.clone(),
        },
        name => {
            if let Some(inner) = name
                .strip_prefix("Nullable(")
                .and_then(|rest| rest.strip_suffix(')'))
            {
                if v.is_null() {
                    return Value::Null;
                }
                return coerce(inner, v);
            }
            if let Some(inner) = name
                .strip_prefix("Array(")
                .and_then(|rest| rest.strip_suffix(')'))
            {
                if let Value::Array(items) = v {
                    return Value::Array(
                        items.iter().map(|item| coerce(inner, item)).collect(),
                    );
                }
            }
            v.clone()
        }
    }
}
