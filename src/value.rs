//! Loose row values.
//!
//! [`Value`] is the row-oriented interchange type: table constructors and
//! builders accept it, `get(i)` on decoded columns produces it, and the
//! `Dynamic`/`JSON` codecs infer wire types from it. Every wire type has a
//! natural `Value` form (64-bit integers stay integers, date-like types
//! become [`chrono`] values, decimals keep their scaled mantissa).

use crate::int256::{
    I256,
    U256,
};
use chrono::{
    DateTime,
    NaiveDate,
    Utc,
};
use std::fmt;
use std::net::{
    Ipv4Addr,
    Ipv6Addr,
};
use uuid::Uuid;

/// A fixed-point decimal: scaled integer mantissa plus scale.
///
/// `mantissa = 12345, scale = 2` represents `123.45`. The mantissa is kept
/// at 256 bits so every `Decimal32..Decimal256` value is representable;
/// textual interchange uses the precision-preserving string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decimal {
    /// Scaled integer mantissa.
    pub mantissa: I256,
    /// Number of digits after the decimal point.
    pub scale: u8,
}

impl Decimal {
    /// Create a decimal from a mantissa already scaled by `10^scale`.
    pub fn new(mantissa: impl Into<I256>, scale: u8) -> Self {
        Self { mantissa: mantissa.into(), scale }
    }

    /// Parse a decimal string like `-123.45` into a mantissa at `scale`.
    ///
    /// Fraction digits beyond `scale` are rejected rather than silently
    /// rounded.
    pub fn parse(s: &str, scale: u8) -> crate::Result<Self> {
        let (neg, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let (int_part, frac_part) = match body.split_once('.') {
            Some((i, f)) => (i, f),
            None => (body, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(crate::Error::Protocol(format!(
                "Invalid decimal literal: {:?}",
                s
            )));
        }
        if frac_part.len() > scale as usize {
            return Err(crate::Error::Protocol(format!(
                "Decimal literal {:?} has more than {} fraction digits",
                s, scale
            )));
        }
        let mut digits = String::with_capacity(body.len() + scale as usize);
        if neg {
            digits.push('-');
        }
        digits.push_str(if int_part.is_empty() { "0" } else { int_part });
        digits.push_str(frac_part);
        for _ in frac_part.len()..scale as usize {
            digits.push('0');
        }
        Ok(Self { mantissa: I256::from_decimal_str(&digits)?, scale })
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let magnitude = self.mantissa.unsigned_abs().to_string();
        let sign = if self.mantissa.is_negative() { "-" } else { "" };
        let scale = self.scale as usize;
        if scale == 0 {
            return write!(f, "{}{}", sign, magnitude);
        }
        if magnitude.len() > scale {
            let (int_part, frac_part) =
                magnitude.split_at(magnitude.len() - scale);
            write!(f, "{}{}.{}", sign, int_part, frac_part)
        } else {
            write!(
                f,
                "{}0.{}{}",
                sign,
                "0".repeat(scale - magnitude.len()),
                magnitude
            )
        }
    }
}

/// A single logical value, independent of its columnar representation.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed integer up to 64 bits.
    Int(i64),
    /// Unsigned integer up to 64 bits.
    UInt(u64),
    /// Signed 128-bit integer.
    Int128(i128),
    /// Unsigned 128-bit integer.
    UInt128(u128),
    /// Signed 256-bit integer.
    Int256(I256),
    /// Unsigned 256-bit integer.
    UInt256(U256),
    /// Floating-point number (Float32 values are widened).
    Float(f64),
    /// Fixed-point decimal.
    Decimal(Decimal),
    /// UTF-8 string.
    String(String),
    /// Raw bytes (FixedString values).
    Bytes(Vec<u8>),
    /// UUID.
    Uuid(Uuid),
    /// IPv4 address.
    Ipv4(Ipv4Addr),
    /// IPv6 address.
    Ipv6(Ipv6Addr),
    /// Calendar date.
    Date(NaiveDate),
    /// Point in time (DateTime and DateTime64).
    DateTime(DateTime<Utc>),
    /// Ordered sequence of values.
    Array(Vec<Value>),
    /// Fixed-arity tuple.
    Tuple(Vec<Value>),
    /// Key-value pairs, in insertion order, duplicates preserved.
    Map(Vec<(Value, Value)>),
}

impl Value {
    /// Whether this is SQL NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// A short name for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::UInt(_) => "UInt",
            Value::Int128(_) => "Int128",
            Value::UInt128(_) => "UInt128",
            Value::Int256(_) => "Int256",
            Value::UInt256(_) => "UInt256",
            Value::Float(_) => "Float",
            Value::Decimal(_) => "Decimal",
            Value::String(_) => "String",
            Value::Bytes(_) => "Bytes",
            Value::Uuid(_) => "Uuid",
            Value::Ipv4(_) => "Ipv4",
            Value::Ipv6(_) => "Ipv6",
            Value::Date(_) => "Date",
            Value::DateTime(_) => "DateTime",
            Value::Array(_) => "Array",
            Value::Tuple(_) => "Tuple",
            Value::Map(_) => "Map",
        }
    }

    /// Coerce to i64 when the value is an integer that fits.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::UInt(v) => i64::try_from(*v).ok(),
            Value::Int128(v) => i64::try_from(*v).ok(),
            Value::UInt128(v) => i64::try_from(*v).ok(),
            Value::Bool(v) => Some(*v as i64),
            _ => None,
        }
    }

    /// Coerce to u64 when the value is a non-negative integer that fits.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt(v) => Some(*v),
            Value::Int(v) => u64::try_from(*v).ok(),
            Value::Int128(v) => u64::try_from(*v).ok(),
            Value::UInt128(v) => u64::try_from(*v).ok(),
            Value::Bool(v) => Some(*v as u64),
            _ => None,
        }
    }

    /// Coerce to f64 when the value is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            Value::UInt(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Borrow the string content, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Convert a `serde_json` value into a loose value.
    ///
    /// Integers stay integers, objects become ordered key-value maps.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::UInt(u)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => {
                Value::Array(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(fields) => Value::Map(
                fields
                    .iter()
                    .map(|(k, v)| {
                        (Value::String(k.clone()), Value::from_json(v))
                    })
                    .collect(),
            ),
        }
    }

    /// Append a canonical byte key for dictionary equivalence.
    ///
    /// Primitives compare by value, dates by epoch milliseconds, byte
    /// sequences byte-wise, and maps by canonical key-sorted
    /// stringification, so equal inputs of equal type always produce
    /// bit-identical keys.
    pub fn canonical_key(&self, out: &mut Vec<u8>) {
        match self {
            Value::Null => out.push(0x00),
            Value::Bool(b) => {
                out.push(0x01);
                out.push(*b as u8);
            }
            Value::Int(v) => {
                out.push(0x02);
                out.extend_from_slice(&v.to_le_bytes());
            }
            Value::UInt(v) => {
                out.push(0x03);
                out.extend_from_slice(&v.to_le_bytes());
            }
            Value::Int128(v) => {
                out.push(0x04);
                out.extend_from_slice(&v.to_le_bytes());
            }
            Value::UInt128(v) => {
                out.push(0x05);
                out.extend_from_slice(&v.to_le_bytes());
            }
            Value::Int256(v) => {
                out.push(0x06);
                out.extend_from_slice(&v.0);
            }
            Value::UInt256(v) => {
                out.push(0x07);
                out.extend_from_slice(&v.0);
            }
            Value::Float(v) => {
                out.push(0x08);
                out.extend_from_slice(&v.to_le_bytes());
            }
            Value::Decimal(d) => {
                out.push(0x09);
                out.push(d.scale);
                out.extend_from_slice(&d.mantissa.0);
            }
            Value::String(s) => {
                out.push(0x0A);
                out.extend_from_slice(&(s.len() as u64).to_le_bytes());
                out.extend_from_slice(s.as_bytes());
            }
            Value::Bytes(b) => {
                out.push(0x0B);
                out.extend_from_slice(&(b.len() as u64).to_le_bytes());
                out.extend_from_slice(b);
            }
            Value::Uuid(u) => {
                out.push(0x0C);
                out.extend_from_slice(u.as_bytes());
            }
            Value::Ipv4(a) => {
                out.push(0x0D);
                out.extend_from_slice(&a.octets());
            }
            Value::Ipv6(a) => {
                out.push(0x0E);
                out.extend_from_slice(&a.octets());
            }
            Value::Date(d) => {
                // Epoch milliseconds at midnight UTC.
                let days = d
                    .signed_duration_since(
                        NaiveDate::from_ymd_opt(1970, 1, 1).expect("epoch"),
                    )
                    .num_days();
                out.push(0x0F);
                out.extend_from_slice(
                    &(days * 86_400_000).to_le_bytes(),
                );
            }
            Value::DateTime(t) => {
                out.push(0x0F);
                out.extend_from_slice(&t.timestamp_millis().to_le_bytes());
            }
            Value::Array(items) | Value::Tuple(items) => {
                out.push(0x10);
                out.extend_from_slice(&(items.len() as u64).to_le_bytes());
                for item in items {
                    item.canonical_key(out);
                }
            }
            Value::Map(pairs) => {
                // Key-sorted so object key order never changes the key.
                let mut entries: Vec<(Vec<u8>, &Value)> = pairs
                    .iter()
                    .map(|(k, v)| {
                        let mut key = Vec::new();
                        k.canonical_key(&mut key);
                        (key, v)
                    })
                    .collect();
                entries.sort_by(|a, b| a.0.cmp(&b.0));
                out.push(0x11);
                out.extend_from_slice(&(entries.len() as u64).to_le_bytes());
                for (key, v) in entries {
                    out.extend_from_slice(&key);
                    v.canonical_key(out);
                }
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(v) => write!(f, "{}", v),
            Value::UInt(v) => write!(f, "{}", v),
            Value::Int128(v) => write!(f, "{}", v),
            Value::UInt128(v) => write!(f, "{}", v),
            Value::Int256(v) => write!(f, "{}", v),
            Value::UInt256(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::String(s) => f.write_str(s),
            Value::Bytes(b) => write!(f, "{:02x?}", b),
            Value::Uuid(u) => write!(f, "{}", u),
            Value::Ipv4(a) => write!(f, "{}", a),
            Value::Ipv6(a) => write!(f, "{}", a),
            Value::Date(d) => write!(f, "{}", d),
            Value::DateTime(t) => write!(f, "{}", t.to_rfc3339()),
            Value::Array(items) | Value::Tuple(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Map(pairs) => {
                f.write_str("{")?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}:{}", k, v)?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::UInt(v as u64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_display() {
        let cases = [
            (12345i128, 2, "123.45"),
            (-12345, 2, "-123.45"),
            (5, 3, "0.005"),
            (-5, 3, "-0.005"),
            (0, 2, "0.00"),
            (7, 0, "7"),
        ];
        for (mantissa, scale, expected) in cases {
            assert_eq!(Decimal::new(mantissa, scale).to_string(), expected);
        }
    }

    #[test]
    fn test_decimal_parse_roundtrip() {
        for s in ["123.45", "-123.45", "0.00", "0.05", "-0.05"] {
            let d = Decimal::parse(s, 2).unwrap();
            assert_eq!(d.to_string(), s);
        }
    }

    #[test]
    fn test_decimal_parse_excess_fraction_rejected() {
        assert!(Decimal::parse("1.234", 2).is_err());
    }

    #[test]
    fn test_json_conversion_keeps_integers() {
        let json: serde_json::Value =
            serde_json::from_str(r#"{"a": 1, "b": [1.5, "x"], "c": null}"#)
                .unwrap();
        let value = Value::from_json(&json);
        match value {
            Value::Map(pairs) => {
                assert_eq!(pairs[0], ("a".into(), Value::Int(1)));
                assert_eq!(
                    pairs[1].1,
                    Value::Array(vec![Value::Float(1.5), "x".into()])
                );
                assert_eq!(pairs[2].1, Value::Null);
            }
            other => panic!("expected map, got {:?}", other),
        }
    }

    #[test]
    fn test_canonical_key_ignores_map_order() {
        let a = Value::Map(vec![
            ("x".into(), Value::Int(1)),
            ("y".into(), Value::Int(2)),
        ]);
        let b = Value::Map(vec![
            ("y".into(), Value::Int(2)),
            ("x".into(), Value::Int(1)),
        ]);
        let (mut ka, mut kb) = (Vec::new(), Vec::new());
        a.canonical_key(&mut ka);
        b.canonical_key(&mut kb);
        assert_eq!(ka, kb);
    }

    #[test]
    fn test_canonical_key_distinguishes_values() {
        let (mut ka, mut kb) = (Vec::new(), Vec::new());
        Value::String("ab".into()).canonical_key(&mut ka);
        Value::Bytes(b"ab".to_vec()).canonical_key(&mut kb);
        assert_ne!(ka, kb);
    }
}
