//! Fixed-width scalar columns.
//!
//! Every fixed-width type (integers up to 256 bits, floats, bool, dates,
//! decimals, enums, UUID, IP addresses, FixedString) shares one columnar
//! representation: a raw little-endian buffer of `length × width` bytes.
//! Payload encode/decode is then a single bulk copy regardless of the
//! element type; values are decoded lazily on `get`.

use crate::int256::{
    I256,
    U256,
};
use crate::types::{
    EnumItem,
    Type,
};
use crate::value::{
    Decimal,
    Value,
};
use crate::{
    Error,
    Result,
};
use chrono::{
    DateTime,
    NaiveDate,
    TimeDelta,
    Utc,
};
use std::net::{
    Ipv4Addr,
    Ipv6Addr,
};
use std::sync::Arc;
use uuid::Uuid;

fn epoch_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).expect("epoch")
}

fn pow10(p: u8) -> i64 {
    10i64.pow(p as u32)
}

/// The element type of a [`ScalarColumn`], with enough metadata to decode
/// and encode single elements.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarKind {
    /// Unsigned 8-bit integer.
    UInt8,
    /// Unsigned 16-bit integer.
    UInt16,
    /// Unsigned 32-bit integer.
    UInt32,
    /// Unsigned 64-bit integer.
    UInt64,
    /// Unsigned 128-bit integer.
    UInt128,
    /// Unsigned 256-bit integer.
    UInt256,
    /// Signed 8-bit integer.
    Int8,
    /// Signed 16-bit integer.
    Int16,
    /// Signed 32-bit integer.
    Int32,
    /// Signed 64-bit integer.
    Int64,
    /// Signed 128-bit integer.
    Int128,
    /// Signed 256-bit integer.
    Int256,
    /// 32-bit float.
    Float32,
    /// 64-bit float.
    Float64,
    /// Boolean, one `1`/`0` byte.
    Bool,
    /// Days since epoch, unsigned 16-bit.
    Date,
    /// Days since epoch, signed 32-bit.
    Date32,
    /// Seconds since epoch, unsigned 32-bit.
    DateTime,
    /// Ticks at scale `10^precision`, signed 64-bit.
    DateTime64 {
        /// Sub-second decimal digits.
        precision: u8,
    },
    /// Scaled-integer decimal of the given storage width (4/8/16/32).
    Decimal {
        /// Digits after the decimal point.
        scale: u8,
        /// Storage width in bytes.
        width: usize,
    },
    /// Enum with Int8 storage.
    Enum8 {
        /// Name/value map (schema metadata, not wire-level).
        items: Arc<[EnumItem]>,
    },
    /// Enum with Int16 storage.
    Enum16 {
        /// Name/value map (schema metadata, not wire-level).
        items: Arc<[EnumItem]>,
    },
    /// UUID, 16 bytes (byte-reversed halves).
    Uuid,
    /// IPv4, 4 bytes.
    Ipv4,
    /// IPv6, 16 bytes.
    Ipv6,
    /// Fixed-length byte string, zero-padded.
    FixedString {
        /// Length in bytes.
        size: usize,
    },
}

impl ScalarKind {
    /// Build the scalar kind for a fixed-width type, if it is one.
    pub fn from_type(ty: &Type) -> Option<ScalarKind> {
        Some(match ty {
            Type::UInt8 => ScalarKind::UInt8,
            Type::UInt16 => ScalarKind::UInt16,
            Type::UInt32 => ScalarKind::UInt32,
            Type::UInt64 => ScalarKind::UInt64,
            Type::UInt128 => ScalarKind::UInt128,
            Type::UInt256 => ScalarKind::UInt256,
            Type::Int8 => ScalarKind::Int8,
            Type::Int16 => ScalarKind::Int16,
            Type::Int32 => ScalarKind::Int32,
            Type::Int64 => ScalarKind::Int64,
            Type::Int128 => ScalarKind::Int128,
            Type::Int256 => ScalarKind::Int256,
            Type::Float32 => ScalarKind::Float32,
            Type::Float64 => ScalarKind::Float64,
            Type::Bool => ScalarKind::Bool,
            Type::Date => ScalarKind::Date,
            Type::Date32 => ScalarKind::Date32,
            Type::DateTime { .. } => ScalarKind::DateTime,
            Type::DateTime64 { precision, .. } => {
                ScalarKind::DateTime64 { precision: *precision }
            }
            Type::Decimal { precision, scale } => ScalarKind::Decimal {
                scale: *scale,
                width: crate::types::decimal_width(*precision),
            },
            Type::Enum8 { items } => {
                ScalarKind::Enum8 { items: items.clone().into() }
            }
            Type::Enum16 { items } => {
                ScalarKind::Enum16 { items: items.clone().into() }
            }
            Type::Uuid => ScalarKind::Uuid,
            Type::Ipv4 => ScalarKind::Ipv4,
            Type::Ipv6 => ScalarKind::Ipv6,
            Type::FixedString { size } => {
                ScalarKind::FixedString { size: *size }
            }
            _ => return None,
        })
    }

    /// Element width in bytes.
    pub fn width(&self) -> usize {
        match self {
            ScalarKind::UInt8
            | ScalarKind::Int8
            | ScalarKind::Bool
            | ScalarKind::Enum8 { .. } => 1,
            ScalarKind::UInt16
            | ScalarKind::Int16
            | ScalarKind::Date
            | ScalarKind::Enum16 { .. } => 2,
            ScalarKind::UInt32
            | ScalarKind::Int32
            | ScalarKind::Float32
            | ScalarKind::Date32
            | ScalarKind::DateTime
            | ScalarKind::Ipv4 => 4,
            ScalarKind::UInt64
            | ScalarKind::Int64
            | ScalarKind::Float64
            | ScalarKind::DateTime64 { .. } => 8,
            ScalarKind::UInt128
            | ScalarKind::Int128
            | ScalarKind::Uuid
            | ScalarKind::Ipv6 => 16,
            ScalarKind::UInt256 | ScalarKind::Int256 => 32,
            ScalarKind::Decimal { width, .. } => *width,
            ScalarKind::FixedString { size } => *size,
        }
    }

    /// Short name used in error messages.
    pub fn type_name(&self) -> String {
        match self {
            ScalarKind::UInt8 => "UInt8".into(),
            ScalarKind::UInt16 => "UInt16".into(),
            ScalarKind::UInt32 => "UInt32".into(),
            ScalarKind::UInt64 => "UInt64".into(),
            ScalarKind::UInt128 => "UInt128".into(),
            ScalarKind::UInt256 => "UInt256".into(),
            ScalarKind::Int8 => "Int8".into(),
            ScalarKind::Int16 => "Int16".into(),
            ScalarKind::Int32 => "Int32".into(),
            ScalarKind::Int64 => "Int64".into(),
            ScalarKind::Int128 => "Int128".into(),
            ScalarKind::Int256 => "Int256".into(),
            ScalarKind::Float32 => "Float32".into(),
            ScalarKind::Float64 => "Float64".into(),
            ScalarKind::Bool => "Bool".into(),
            ScalarKind::Date => "Date".into(),
            ScalarKind::Date32 => "Date32".into(),
            ScalarKind::DateTime => "DateTime".into(),
            ScalarKind::DateTime64 { precision } => {
                format!("DateTime64({})", precision)
            }
            ScalarKind::Decimal { scale, width } => {
                format!("Decimal({}b, {})", width, scale)
            }
            ScalarKind::Enum8 { .. } => "Enum8".into(),
            ScalarKind::Enum16 { .. } => "Enum16".into(),
            ScalarKind::Uuid => "UUID".into(),
            ScalarKind::Ipv4 => "IPv4".into(),
            ScalarKind::Ipv6 => "IPv6".into(),
            ScalarKind::FixedString { size } => {
                format!("FixedString({})", size)
            }
        }
    }

    /// Decode one element from exactly `width` bytes.
    pub fn decode_value(&self, raw: &[u8]) -> Value {
        debug_assert_eq!(raw.len(), self.width());
        match self {
            ScalarKind::UInt8 => Value::UInt(raw[0] as u64),
            ScalarKind::UInt16 => {
                Value::UInt(u16::from_le_bytes(raw.try_into().unwrap()) as u64)
            }
            ScalarKind::UInt32 => {
                Value::UInt(u32::from_le_bytes(raw.try_into().unwrap()) as u64)
            }
            ScalarKind::UInt64 => {
                Value::UInt(u64::from_le_bytes(raw.try_into().unwrap()))
            }
            ScalarKind::UInt128 => {
                Value::UInt128(u128::from_le_bytes(raw.try_into().unwrap()))
            }
            ScalarKind::UInt256 => {
                Value::UInt256(U256(raw.try_into().unwrap()))
            }
            ScalarKind::Int8 => Value::Int(raw[0] as i8 as i64),
            ScalarKind::Int16 => {
                Value::Int(i16::from_le_bytes(raw.try_into().unwrap()) as i64)
            }
            ScalarKind::Int32 => {
                Value::Int(i32::from_le_bytes(raw.try_into().unwrap()) as i64)
            }
            ScalarKind::Int64 => {
                Value::Int(i64::from_le_bytes(raw.try_into().unwrap()))
            }
            ScalarKind::Int128 => {
                Value::Int128(i128::from_le_bytes(raw.try_into().unwrap()))
            }
            ScalarKind::Int256 => {
                Value::Int256(I256(raw.try_into().unwrap()))
            }
            ScalarKind::Float32 => Value::Float(
                f32::from_le_bytes(raw.try_into().unwrap()) as f64,
            ),
            ScalarKind::Float64 => {
                Value::Float(f64::from_le_bytes(raw.try_into().unwrap()))
            }
            ScalarKind::Bool => Value::Bool(raw[0] != 0),
            ScalarKind::Date => {
                let days = u16::from_le_bytes(raw.try_into().unwrap());
                Value::Date(
                    epoch_date()
                        .checked_add_signed(TimeDelta::days(days as i64))
                        .unwrap_or_else(epoch_date),
                )
            }
            ScalarKind::Date32 => {
                let days = i32::from_le_bytes(raw.try_into().unwrap());
                Value::Date(
                    epoch_date()
                        .checked_add_signed(TimeDelta::days(days as i64))
                        .unwrap_or_else(epoch_date),
                )
            }
            ScalarKind::DateTime => {
                let secs = u32::from_le_bytes(raw.try_into().unwrap());
                Value::DateTime(
                    DateTime::from_timestamp(secs as i64, 0)
                        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
                )
            }
            ScalarKind::DateTime64 { precision } => {
                let ticks = i64::from_le_bytes(raw.try_into().unwrap());
                let divisor = pow10(*precision);
                let secs = ticks.div_euclid(divisor);
                let rem = ticks.rem_euclid(divisor);
                let nanos = if *precision <= 9 {
                    rem * pow10(9 - precision)
                } else {
                    rem / pow10(precision - 9)
                };
                Value::DateTime(
                    DateTime::from_timestamp(secs, nanos as u32)
                        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
                )
            }
            ScalarKind::Decimal { scale, width } => {
                let mantissa = match width {
                    4 => I256::from_i128(i32::from_le_bytes(
                        raw.try_into().unwrap(),
                    ) as i128),
                    8 => I256::from_i128(i64::from_le_bytes(
                        raw.try_into().unwrap(),
                    ) as i128),
                    16 => I256::from_i128(i128::from_le_bytes(
                        raw.try_into().unwrap(),
                    )),
                    _ => I256(raw.try_into().unwrap()),
                };
                Value::Decimal(Decimal { mantissa, scale: *scale })
            }
            ScalarKind::Enum8 { items } => {
                let code = raw[0] as i8 as i16;
                enum_value(items, code)
            }
            ScalarKind::Enum16 { items } => {
                let code = i16::from_le_bytes(raw.try_into().unwrap());
                enum_value(items, code)
            }
            ScalarKind::Uuid => {
                // Wire is the UUID as a little-endian u128: reversed low
                // half first, then reversed high half.
                let mut canonical = [0u8; 16];
                for i in 0..8 {
                    canonical[8 + i] = raw[7 - i];
                    canonical[i] = raw[15 - i];
                }
                Value::Uuid(Uuid::from_bytes(canonical))
            }
            ScalarKind::Ipv4 => Value::Ipv4(Ipv4Addr::from(
                u32::from_le_bytes(raw.try_into().unwrap()),
            )),
            ScalarKind::Ipv6 => {
                let octets: [u8; 16] = raw.try_into().unwrap();
                Value::Ipv6(Ipv6Addr::from(octets))
            }
            ScalarKind::FixedString { .. } => Value::Bytes(raw.to_vec()),
        }
    }

    /// Encode one element, appending exactly `width` bytes to `out`.
    pub fn encode_value(&self, v: &Value, out: &mut Vec<u8>) -> Result<()> {
        let mismatch = || Error::TypeMismatch {
            expected: self.type_name(),
            actual: format!("{} value {}", v.kind_name(), v),
        };
        match self {
            ScalarKind::UInt8 => {
                let v = v.as_u64().and_then(|v| u8::try_from(v).ok());
                out.push(v.ok_or_else(mismatch)?);
            }
            ScalarKind::UInt16 => {
                let v = v.as_u64().and_then(|v| u16::try_from(v).ok());
                out.extend_from_slice(&v.ok_or_else(mismatch)?.to_le_bytes());
            }
            ScalarKind::UInt32 => {
                let v = v.as_u64().and_then(|v| u32::try_from(v).ok());
                out.extend_from_slice(&v.ok_or_else(mismatch)?.to_le_bytes());
            }
            ScalarKind::UInt64 => {
                let v = v.as_u64().ok_or_else(mismatch)?;
                out.extend_from_slice(&v.to_le_bytes());
            }
            ScalarKind::UInt128 => {
                let v = match v {
                    Value::UInt128(v) => Some(*v),
                    other => other.as_u64().map(|v| v as u128),
                };
                out.extend_from_slice(&v.ok_or_else(mismatch)?.to_le_bytes());
            }
            ScalarKind::UInt256 => {
                let v = match v {
                    Value::UInt256(v) => Some(*v),
                    Value::UInt128(v) => Some(U256::from_u128(*v)),
                    other => other.as_u64().map(|v| U256::from_u128(v as u128)),
                };
                out.extend_from_slice(&v.ok_or_else(mismatch)?.0);
            }
            ScalarKind::Int8 => {
                let v = v.as_i64().and_then(|v| i8::try_from(v).ok());
                out.extend_from_slice(&v.ok_or_else(mismatch)?.to_le_bytes());
            }
            ScalarKind::Int16 => {
                let v = v.as_i64().and_then(|v| i16::try_from(v).ok());
                out.extend_from_slice(&v.ok_or_else(mismatch)?.to_le_bytes());
            }
            ScalarKind::Int32 => {
                let v = v.as_i64().and_then(|v| i32::try_from(v).ok());
                out.extend_from_slice(&v.ok_or_else(mismatch)?.to_le_bytes());
            }
            ScalarKind::Int64 => {
                let v = v.as_i64().ok_or_else(mismatch)?;
                out.extend_from_slice(&v.to_le_bytes());
            }
            ScalarKind::Int128 => {
                let v = match v {
                    Value::Int128(v) => Some(*v),
                    Value::UInt128(v) => i128::try_from(*v).ok(),
                    other => other.as_i64().map(|v| v as i128),
                };
                out.extend_from_slice(&v.ok_or_else(mismatch)?.to_le_bytes());
            }
            ScalarKind::Int256 => {
                let v = match v {
                    Value::Int256(v) => Some(*v),
                    Value::Int128(v) => Some(I256::from_i128(*v)),
                    other => other.as_i64().map(|v| I256::from_i128(v as i128)),
                };
                out.extend_from_slice(&v.ok_or_else(mismatch)?.0);
            }
            ScalarKind::Float32 => {
                let v = v.as_f64().ok_or_else(mismatch)?;
                out.extend_from_slice(&(v as f32).to_le_bytes());
            }
            ScalarKind::Float64 => {
                let v = v.as_f64().ok_or_else(mismatch)?;
                out.extend_from_slice(&v.to_le_bytes());
            }
            ScalarKind::Bool => match v {
                Value::Bool(b) => out.push(*b as u8),
                Value::Int(0) | Value::UInt(0) => out.push(0),
                Value::Int(1) | Value::UInt(1) => out.push(1),
                _ => return Err(mismatch()),
            },
            ScalarKind::Date => {
                let days = match v {
                    Value::Date(d) => d
                        .signed_duration_since(epoch_date())
                        .num_days(),
                    other => other.as_i64().ok_or_else(mismatch)?,
                };
                let days = u16::try_from(days).map_err(|_| mismatch())?;
                out.extend_from_slice(&days.to_le_bytes());
            }
            ScalarKind::Date32 => {
                let days = match v {
                    Value::Date(d) => d
                        .signed_duration_since(epoch_date())
                        .num_days(),
                    other => other.as_i64().ok_or_else(mismatch)?,
                };
                let days = i32::try_from(days).map_err(|_| mismatch())?;
                out.extend_from_slice(&days.to_le_bytes());
            }
            ScalarKind::DateTime => {
                let secs = match v {
                    Value::DateTime(t) => t.timestamp(),
                    other => other.as_i64().ok_or_else(mismatch)?,
                };
                let secs = u32::try_from(secs).map_err(|_| mismatch())?;
                out.extend_from_slice(&secs.to_le_bytes());
            }
            ScalarKind::DateTime64 { precision } => {
                let ticks = match v {
                    Value::DateTime(t) => {
                        let secs = t.timestamp();
                        let nanos = t.timestamp_subsec_nanos() as i64;
                        if *precision <= 9 {
                            secs * pow10(*precision)
                                + nanos / pow10(9 - precision)
                        } else {
                            secs * pow10(*precision)
                                + nanos * pow10(precision - 9)
                        }
                    }
                    other => other.as_i64().ok_or_else(mismatch)?,
                };
                out.extend_from_slice(&ticks.to_le_bytes());
            }
            ScalarKind::Decimal { scale, width } => {
                let mantissa = match v {
                    Value::Decimal(d) if d.scale == *scale => d.mantissa,
                    Value::String(s) => {
                        Decimal::parse(s, *scale)?.mantissa
                    }
                    Value::Int(i) => {
                        I256::from_i128(*i as i128 * pow10(*scale) as i128)
                    }
                    Value::UInt(u) => {
                        I256::from_i128(*u as i128 * pow10(*scale) as i128)
                    }
                    _ => return Err(mismatch()),
                };
                match width {
                    4 => {
                        let m = mantissa
                            .to_i128()
                            .and_then(|m| i32::try_from(m).ok())
                            .ok_or_else(mismatch)?;
                        out.extend_from_slice(&m.to_le_bytes());
                    }
                    8 => {
                        let m = mantissa
                            .to_i128()
                            .and_then(|m| i64::try_from(m).ok())
                            .ok_or_else(mismatch)?;
                        out.extend_from_slice(&m.to_le_bytes());
                    }
                    16 => {
                        let m = mantissa.to_i128().ok_or_else(mismatch)?;
                        out.extend_from_slice(&m.to_le_bytes());
                    }
                    _ => out.extend_from_slice(&mantissa.0),
                }
            }
            ScalarKind::Enum8 { items } => {
                let code = enum_code(items, v).ok_or_else(mismatch)?;
                let code = i8::try_from(code).map_err(|_| mismatch())?;
                out.extend_from_slice(&code.to_le_bytes());
            }
            ScalarKind::Enum16 { items } => {
                let code = enum_code(items, v).ok_or_else(mismatch)?;
                out.extend_from_slice(&code.to_le_bytes());
            }
            ScalarKind::Uuid => {
                let uuid = match v {
                    Value::Uuid(u) => *u,
                    Value::String(s) => {
                        Uuid::parse_str(s).map_err(|_| mismatch())?
                    }
                    _ => return Err(mismatch()),
                };
                let canonical = uuid.as_bytes();
                let mut wire = [0u8; 16];
                for i in 0..8 {
                    wire[i] = canonical[15 - i];
                    wire[8 + i] = canonical[7 - i];
                }
                out.extend_from_slice(&wire);
            }
            ScalarKind::Ipv4 => {
                let addr = match v {
                    Value::Ipv4(a) => *a,
                    Value::String(s) => {
                        s.parse::<Ipv4Addr>().map_err(|_| mismatch())?
                    }
                    _ => return Err(mismatch()),
                };
                out.extend_from_slice(&u32::from(addr).to_le_bytes());
            }
            ScalarKind::Ipv6 => {
                let addr = match v {
                    Value::Ipv6(a) => *a,
                    Value::String(s) => {
                        s.parse::<Ipv6Addr>().map_err(|_| mismatch())?
                    }
                    _ => return Err(mismatch()),
                };
                out.extend_from_slice(&addr.octets());
            }
            ScalarKind::FixedString { size } => {
                let bytes = match v {
                    Value::Bytes(b) => b.as_slice(),
                    Value::String(s) => s.as_bytes(),
                    _ => return Err(mismatch()),
                };
                if bytes.len() > *size {
                    return Err(Error::LengthMismatch {
                        what: format!("FixedString({})", size),
                        expected: *size,
                        got: bytes.len(),
                    });
                }
                out.extend_from_slice(bytes);
                out.resize(out.len() + (size - bytes.len()), 0);
            }
        }
        Ok(())
    }

    /// The type's default value, used behind null flags and sparse fills.
    ///
    /// For every fixed-width kind this is the all-zero element.
    pub fn zero_value(&self) -> Value {
        let zeros = vec![0u8; self.width()];
        self.decode_value(&zeros)
    }
}

fn enum_value(items: &[EnumItem], code: i16) -> Value {
    match items.iter().find(|item| item.value == code) {
        Some(item) => Value::String(item.name.clone()),
        None => Value::Int(code as i64),
    }
}

fn enum_code(items: &[EnumItem], v: &Value) -> Option<i16> {
    match v {
        Value::String(name) => {
            items.iter().find(|item| item.name == *name).map(|i| i.value)
        }
        other => {
            let code = i16::try_from(other.as_i64()?).ok()?;
            items.iter().find(|item| item.value == code).map(|i| i.value)
        }
    }
}

/// A column of fixed-width elements over a raw little-endian buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarColumn {
    kind: ScalarKind,
    data: Vec<u8>,
}

impl ScalarColumn {
    /// Create an empty column of the given kind.
    pub fn new(kind: ScalarKind) -> Self {
        Self { kind, data: Vec::new() }
    }

    /// Create an empty column with room for `rows` elements.
    pub fn with_capacity(kind: ScalarKind, rows: usize) -> Self {
        let width = kind.width();
        Self { kind, data: Vec::with_capacity(rows * width) }
    }

    /// Wrap an existing raw buffer. The buffer length must be a multiple of
    /// the element width.
    pub fn from_raw(kind: ScalarKind, data: Vec<u8>) -> Result<Self> {
        let width = kind.width();
        if width == 0 || data.len() % width != 0 {
            return Err(Error::LengthMismatch {
                what: format!("{} raw buffer", kind.type_name()),
                expected: width,
                got: data.len(),
            });
        }
        Ok(Self { kind, data })
    }

    /// The element kind.
    pub fn kind(&self) -> &ScalarKind {
        &self.kind
    }

    /// The raw little-endian buffer (`len() × width` bytes).
    pub fn raw(&self) -> &[u8] {
        &self.data
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len() / self.kind.width()
    }

    /// Whether the column has no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Decode the element at `index`.
    pub fn get(&self, index: usize) -> Value {
        let width = self.kind.width();
        self.kind.decode_value(&self.data[index * width..(index + 1) * width])
    }

    /// Append one value.
    pub fn push(&mut self, v: &Value) -> Result<()> {
        self.kind.encode_value(v, &mut self.data)
    }

    /// Append the type's zero element.
    pub fn push_zero(&mut self) {
        self.data.resize(self.data.len() + self.kind.width(), 0);
    }

    /// Copy out the element range `[start, end)`.
    pub fn slice(&self, start: usize, end: usize) -> ScalarColumn {
        let width = self.kind.width();
        ScalarColumn {
            kind: self.kind.clone(),
            data: self.data[start * width..end * width].to_vec(),
        }
    }

    /// Append all elements of `other`, which must have the same kind.
    pub fn append(&mut self, other: &ScalarColumn) -> Result<()> {
        if self.kind != other.kind {
            return Err(Error::TypeMismatch {
                expected: self.kind.type_name(),
                actual: other.kind.type_name(),
            });
        }
        self.data.extend_from_slice(&other.data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uint32_roundtrip() {
        let mut col = ScalarColumn::new(ScalarKind::UInt32);
        for v in [0u32, 1, 42, u32::MAX] {
            col.push(&Value::UInt(v as u64)).unwrap();
        }
        assert_eq!(col.len(), 4);
        assert_eq!(col.get(1), Value::UInt(1));
        assert_eq!(col.get(3), Value::UInt(u32::MAX as u64));
        assert_eq!(col.raw().len(), 16);
    }

    #[test]
    fn test_out_of_range_rejected() {
        let mut col = ScalarColumn::new(ScalarKind::UInt8);
        assert!(col.push(&Value::UInt(256)).is_err());
        let mut col = ScalarColumn::new(ScalarKind::Int8);
        assert!(col.push(&Value::Int(128)).is_err());
        assert!(col.push(&Value::String("x".into())).is_err());
    }

    #[test]
    fn test_date_roundtrip() {
        let mut col = ScalarColumn::new(ScalarKind::Date);
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        col.push(&Value::Date(date)).unwrap();
        assert_eq!(col.get(0), Value::Date(date));
        // 2024-02-29 is 19782 days past the epoch.
        assert_eq!(col.raw(), &19782u16.to_le_bytes());
    }

    #[test]
    fn test_datetime64_millis() {
        let kind = ScalarKind::DateTime64 { precision: 3 };
        let mut col = ScalarColumn::new(kind);
        let t = DateTime::from_timestamp(1_700_000_000, 123_000_000).unwrap();
        col.push(&Value::DateTime(t)).unwrap();
        assert_eq!(col.raw(), &1_700_000_000_123i64.to_le_bytes());
        assert_eq!(col.get(0), Value::DateTime(t));
    }

    #[test]
    fn test_uuid_byte_reversal() {
        let mut col = ScalarColumn::new(ScalarKind::Uuid);
        let uuid =
            Uuid::parse_str("00112233-4455-6677-8899-aabbccddeeff").unwrap();
        col.push(&Value::Uuid(uuid)).unwrap();
        assert_eq!(
            col.raw(),
            &[
                0xff, 0xee, 0xdd, 0xcc, 0xbb, 0xaa, 0x99, 0x88, // low
                0x77, 0x66, 0x55, 0x44, 0x33, 0x22, 0x11, 0x00, // high
            ]
        );
        assert_eq!(col.get(0), Value::Uuid(uuid));
    }

    #[test]
    fn test_ipv4_little_endian() {
        let mut col = ScalarColumn::new(ScalarKind::Ipv4);
        col.push(&Value::String("1.2.3.4".into())).unwrap();
        assert_eq!(col.raw(), &[4, 3, 2, 1]);
        assert_eq!(col.get(0), Value::Ipv4("1.2.3.4".parse().unwrap()));
    }

    #[test]
    fn test_decimal_scaling() {
        let kind = ScalarKind::Decimal { scale: 2, width: 8 };
        let mut col = ScalarColumn::new(kind);
        col.push(&Value::String("123.45".into())).unwrap();
        col.push(&Value::Int(-7)).unwrap();
        assert_eq!(col.get(0), Value::Decimal(Decimal::new(12345, 2)));
        assert_eq!(col.get(0).to_string(), "123.45");
        assert_eq!(col.get(1).to_string(), "-7.00");
    }

    #[test]
    fn test_enum_names() {
        let items: Arc<[EnumItem]> = vec![
            EnumItem { name: "red".into(), value: 1 },
            EnumItem { name: "green".into(), value: 2 },
        ]
        .into();
        let mut col = ScalarColumn::new(ScalarKind::Enum8 { items });
        col.push(&Value::String("green".into())).unwrap();
        col.push(&Value::Int(1)).unwrap();
        assert!(col.push(&Value::String("blue".into())).is_err());
        assert_eq!(col.get(0), Value::String("green".into()));
        assert_eq!(col.get(1), Value::String("red".into()));
        assert_eq!(col.raw(), &[2, 1]);
    }

    #[test]
    fn test_fixed_string_padding() {
        let mut col = ScalarColumn::new(ScalarKind::FixedString { size: 4 });
        col.push(&Value::String("ab".into())).unwrap();
        assert_eq!(col.raw(), b"ab\0\0");
        assert_eq!(col.get(0), Value::Bytes(b"ab\0\0".to_vec()));
        assert!(col.push(&Value::String("toolong".into())).is_err());
    }

    #[test]
    fn test_zero_values() {
        assert_eq!(ScalarKind::UInt64.zero_value(), Value::UInt(0));
        assert_eq!(ScalarKind::Bool.zero_value(), Value::Bool(false));
        assert_eq!(
            ScalarKind::Date.zero_value(),
            Value::Date(epoch_date())
        );
        assert_eq!(
            ScalarKind::Uuid.zero_value(),
            Value::Uuid(Uuid::nil())
        );
    }

    #[test]
    fn test_slice_copies_range() {
        let mut col = ScalarColumn::new(ScalarKind::Int16);
        for v in 0..10 {
            col.push(&Value::Int(v)).unwrap();
        }
        let sliced = col.slice(2, 7);
        assert_eq!(sliced.len(), 5);
        assert_eq!(sliced.get(0), Value::Int(2));
        assert_eq!(sliced.get(4), Value::Int(6));
    }
}
