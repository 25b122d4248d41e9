//! The Native format type system.
//!
//! A schema element is a `(name, type string)` pair where the type string is
//! a recursive expression over ~40 scalar and composite types. [`Type`]
//! models the parsed form; [`Type::parse`] and [`Type::name`] convert
//! between the two representations so that `parse(name(t)) == t`.
//!
//! Aliases (`Nested`, the geo types, `SimpleAggregateFunction`) are expanded
//! during parsing; the original spelling survives only in the schema's type
//! string, which the block framer carries verbatim.

mod parser;

use parser::TypeParser;

/// Enum item for Enum8/Enum16 types, mapping a name to its integer value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumItem {
    /// The string name of this enum variant.
    pub name: String,
    /// The integer value associated with this enum variant.
    pub value: i16,
}

/// One element of a Tuple type, optionally named.
///
/// Named and unnamed tuples share the same wire layout; the names are
/// schema metadata only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TupleElement {
    /// Element name for named tuples (and Nested expansions).
    pub name: Option<String>,
    /// The element type.
    pub ty: Type,
}

/// A parsed Native format type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
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
    /// 32-bit IEEE 754 float.
    Float32,
    /// 64-bit IEEE 754 float.
    Float64,
    /// Boolean stored as one byte.
    Bool,
    /// Variable-length UTF-8 string.
    String,
    /// Fixed-length byte string, right-padded with zeros.
    FixedString {
        /// Length in bytes.
        size: usize,
    },
    /// UUID (128-bit).
    Uuid,
    /// IPv4 address stored as a 32-bit integer.
    Ipv4,
    /// IPv6 address stored as 16 raw bytes.
    Ipv6,
    /// Days since 1970-01-01, unsigned 16-bit.
    Date,
    /// Days since 1970-01-01, signed 32-bit.
    Date32,
    /// Seconds since 1970-01-01, unsigned 32-bit.
    DateTime {
        /// Optional IANA timezone name (schema metadata only).
        timezone: Option<String>,
    },
    /// Signed 64-bit ticks at scale `10^precision`.
    DateTime64 {
        /// Number of sub-second decimal digits (0 to 18).
        precision: u8,
        /// Optional IANA timezone name (schema metadata only).
        timezone: Option<String>,
    },
    /// Fixed-point decimal; storage width is derived from the precision.
    Decimal {
        /// Total number of significant digits (1 to 76).
        precision: u8,
        /// Number of digits after the decimal point.
        scale: u8,
    },
    /// Enumeration with Int8 storage.
    Enum8 {
        /// The named variants with their integer values.
        items: Vec<EnumItem>,
    },
    /// Enumeration with Int16 storage.
    Enum16 {
        /// The named variants with their integer values.
        items: Vec<EnumItem>,
    },
    /// Nullable wrapper around the nested type.
    Nullable {
        /// The type that is made nullable.
        nested_type: Box<Type>,
    },
    /// Variable-length array of the item type.
    Array {
        /// The type of each element.
        item_type: Box<Type>,
    },
    /// Key-value map.
    Map {
        /// The type of map keys.
        key_type: Box<Type>,
        /// The type of map values.
        value_type: Box<Type>,
    },
    /// Fixed-size tuple of heterogeneous element types.
    Tuple {
        /// The ordered, optionally named element types.
        elements: Vec<TupleElement>,
    },
    /// Dictionary-encoded wrapper around the nested type.
    LowCardinality {
        /// The type that is dictionary-encoded.
        nested_type: Box<Type>,
    },
    /// Discriminated union over the listed types.
    Variant {
        /// The variant types, in declaration order (at most 255).
        variants: Vec<Type>,
    },
    /// Self-describing column whose per-block types are learned from the
    /// prefix.
    Dynamic,
    /// Path-indexed JSON column (flattened, version 3 serialization).
    Json,
}

impl Type {
    /// Parse a type from its string representation.
    pub fn parse(type_str: &str) -> crate::Result<Self> {
        TypeParser::new(type_str).parse()
    }

    /// Render the canonical type string, including parameters.
    pub fn name(&self) -> String {
        match self {
            Type::UInt8 => "UInt8".to_string(),
            Type::UInt16 => "UInt16".to_string(),
            Type::UInt32 => "UInt32".to_string(),
            Type::UInt64 => "UInt64".to_string(),
            Type::UInt128 => "UInt128".to_string(),
            Type::UInt256 => "UInt256".to_string(),
            Type::Int8 => "Int8".to_string(),
            Type::Int16 => "Int16".to_string(),
            Type::Int32 => "Int32".to_string(),
            Type::Int64 => "Int64".to_string(),
            Type::Int128 => "Int128".to_string(),
            Type::Int256 => "Int256".to_string(),
            Type::Float32 => "Float32".to_string(),
            Type::Float64 => "Float64".to_string(),
            Type::Bool => "Bool".to_string(),
            Type::String => "String".to_string(),
            Type::FixedString { size } => format!("FixedString({})", size),
            Type::Uuid => "UUID".to_string(),
            Type::Ipv4 => "IPv4".to_string(),
            Type::Ipv6 => "IPv6".to_string(),
            Type::Date => "Date".to_string(),
            Type::Date32 => "Date32".to_string(),
            Type::DateTime { timezone: None } => "DateTime".to_string(),
            Type::DateTime { timezone: Some(tz) } => {
                format!("DateTime('{}')", tz)
            }
            Type::DateTime64 { precision, timezone: None } => {
                format!("DateTime64({})", precision)
            }
            Type::DateTime64 { precision, timezone: Some(tz) } => {
                format!("DateTime64({}, '{}')", precision, tz)
            }
            Type::Decimal { precision, scale } => {
                format!("Decimal({}, {})", precision, scale)
            }
            Type::Enum8 { items } => {
                format!("Enum8({})", format_enum_items(items))
            }
            Type::Enum16 { items } => {
                format!("Enum16({})", format_enum_items(items))
            }
            Type::Nullable { nested_type } => {
                format!("Nullable({})", nested_type.name())
            }
            Type::Array { item_type } => {
                format!("Array({})", item_type.name())
            }
            Type::Map { key_type, value_type } => {
                format!("Map({}, {})", key_type.name(), value_type.name())
            }
            Type::Tuple { elements } => {
                let parts: Vec<String> = elements
                    .iter()
                    .map(|e| match &e.name {
                        Some(name) => format!("{} {}", name, e.ty.name()),
                        None => e.ty.name(),
                    })
                    .collect();
                format!("Tuple({})", parts.join(", "))
            }
            Type::LowCardinality { nested_type } => {
                format!("LowCardinality({})", nested_type.name())
            }
            Type::Variant { variants } => {
                let parts: Vec<String> =
                    variants.iter().map(|t| t.name()).collect();
                format!("Variant({})", parts.join(", "))
            }
            Type::Dynamic => "Dynamic".to_string(),
            Type::Json => "JSON".to_string(),
        }
    }

    /// Creates an Array type with the given element type.
    pub fn array(item_type: Type) -> Self {
        Type::Array { item_type: Box::new(item_type) }
    }

    /// Creates a Nullable wrapper around the given type.
    pub fn nullable(nested_type: Type) -> Self {
        Type::Nullable { nested_type: Box::new(nested_type) }
    }

    /// Creates a Map type with the given key and value types.
    pub fn map(key_type: Type, value_type: Type) -> Self {
        Type::Map {
            key_type: Box::new(key_type),
            value_type: Box::new(value_type),
        }
    }

    /// Creates an unnamed Tuple type with the given element types.
    pub fn tuple(item_types: Vec<Type>) -> Self {
        Type::Tuple {
            elements: item_types
                .into_iter()
                .map(|ty| TupleElement { name: None, ty })
                .collect(),
        }
    }

    /// Creates a LowCardinality wrapper around the given type.
    pub fn low_cardinality(nested_type: Type) -> Self {
        Type::LowCardinality { nested_type: Box::new(nested_type) }
    }

    /// Creates a Variant type over the given types.
    pub fn variant(variants: Vec<Type>) -> Self {
        Type::Variant { variants }
    }

    /// Storage width in bytes for fixed-size types, `None` otherwise.
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            Type::UInt8 | Type::Int8 | Type::Bool => Some(1),
            Type::UInt16 | Type::Int16 | Type::Date => Some(2),
            Type::UInt32
            | Type::Int32
            | Type::Float32
            | Type::Date32
            | Type::Ipv4
            | Type::DateTime { .. } => Some(4),
            Type::UInt64
            | Type::Int64
            | Type::Float64
            | Type::DateTime64 { .. } => Some(8),
            Type::UInt128 | Type::Int128 | Type::Uuid | Type::Ipv6 => {
                Some(16)
            }
            Type::UInt256 | Type::Int256 => Some(32),
            Type::FixedString { size } => Some(*size),
            Type::Enum8 { .. } => Some(1),
            Type::Enum16 { .. } => Some(2),
            Type::Decimal { precision, .. } => {
                Some(decimal_width(*precision))
            }
            _ => None,
        }
    }

    /// Returns the enum variant name for the given integer value.
    pub fn enum_name(&self, value: i16) -> Option<&str> {
        self.enum_items()?
            .iter()
            .find(|item| item.value == value)
            .map(|item| item.name.as_str())
    }

    /// Returns the integer value for the given enum variant name.
    pub fn enum_value(&self, name: &str) -> Option<i16> {
        self.enum_items()?
            .iter()
            .find(|item| item.name == name)
            .map(|item| item.value)
    }

    /// Returns the enum items if this is an Enum8 or Enum16 type.
    pub fn enum_items(&self) -> Option<&[EnumItem]> {
        match self {
            Type::Enum8 { items } | Type::Enum16 { items } => Some(items),
            _ => None,
        }
    }
}

/// Storage width in bytes for a decimal of the given precision.
pub fn decimal_width(precision: u8) -> usize {
    match precision {
        0..=9 => 4,
        10..=18 => 8,
        19..=38 => 16,
        _ => 32,
    }
}

fn format_enum_items(items: &[EnumItem]) -> String {
    let formatted: Vec<String> = items
        .iter()
        .map(|item| format!("'{}' = {}", item.name, item.value))
        .collect();
    formatted.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_roundtrip() {
        let names = [
            "UInt8",
            "Nullable(String)",
            "Array(Array(Int64))",
            "Map(String, UInt32)",
            "Tuple(UInt8, String)",
            "Tuple(a UInt8, b String)",
            "LowCardinality(Nullable(String))",
            "Variant(Array(UInt64), String, UInt64)",
            "Decimal(10, 2)",
            "DateTime64(3, 'UTC')",
            "Enum16('on' = 1, 'off' = 0)",
            "Dynamic",
            "JSON",
        ];
        for name in names {
            let ty = Type::parse(name).unwrap();
            assert_eq!(ty.name(), name);
            assert_eq!(Type::parse(&ty.name()).unwrap(), ty);
        }
    }

    #[test]
    fn test_fixed_width() {
        assert_eq!(Type::UInt32.fixed_width(), Some(4));
        assert_eq!(Type::parse("FixedString(10)").unwrap().fixed_width(), Some(10));
        assert_eq!(Type::parse("Decimal(20, 4)").unwrap().fixed_width(), Some(16));
        assert_eq!(Type::parse("Decimal256(4)").unwrap().fixed_width(), Some(32));
        assert_eq!(Type::String.fixed_width(), None);
        assert_eq!(Type::parse("Array(UInt8)").unwrap().fixed_width(), None);
    }

    #[test]
    fn test_decimal_width_breakpoints() {
        assert_eq!(decimal_width(9), 4);
        assert_eq!(decimal_width(10), 8);
        assert_eq!(decimal_width(18), 8);
        assert_eq!(decimal_width(19), 16);
        assert_eq!(decimal_width(38), 16);
        assert_eq!(decimal_width(39), 32);
    }

    #[test]
    fn test_enum_lookup() {
        let ty = Type::parse("Enum8('a' = 1, 'b' = -3)").unwrap();
        assert_eq!(ty.enum_name(-3), Some("b"));
        assert_eq!(ty.enum_value("a"), Some(1));
        assert_eq!(ty.enum_name(7), None);
        assert_eq!(Type::UInt8.enum_items(), None);
    }
}
