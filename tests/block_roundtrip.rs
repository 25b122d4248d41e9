// Block-level wire tests: literal byte layouts for representative schemas
// plus round-trip laws across the supported type matrix.

use chrono::{
    DateTime,
    NaiveDate,
};
use clickhouse_native_format::binary::Reader;
use clickhouse_native_format::codec::VariantCodec;
use clickhouse_native_format::value::Decimal;
use clickhouse_native_format::{
    decode_all,
    decode_block,
    encode_block,
    get_codec,
    table_from_arrays,
    table_from_rows,
    to_array_rows,
    Block,
    DecodeOptions,
    SchemaColumn,
    Value,
};

fn single_column_block(name: &str, ty: &str, values: &[Value]) -> Block {
    table_from_arrays(
        &[SchemaColumn::new(name, ty)],
        &[values.to_vec()],
    )
    .unwrap()
}

fn decode(bytes: &[u8]) -> Block {
    let mut r = Reader::new(bytes);
    let block =
        decode_block(&mut r, &DecodeOptions::default()).unwrap().unwrap();
    assert_eq!(r.remaining(), 0, "block fully consumed");
    block
}

/// Laws 1 and 2: values survive a round trip, and re-encoding a decoded
/// block reproduces the input bytes exactly.
fn assert_roundtrip(ty: &str, values: Vec<Value>) {
    let block = single_column_block("c", ty, &values);
    let bytes = encode_block(&block).unwrap();
    let decoded = decode(&bytes);

    assert_eq!(decoded.row_count(), values.len(), "{}", ty);
    assert_eq!(
        decoded.column(0).unwrap().data.materialize(),
        values,
        "{}",
        ty
    );
    assert_eq!(
        encode_block(&decoded).unwrap(),
        bytes,
        "re-encode of {} not byte-identical",
        ty
    );
}

#[test]
fn uint32_block_bytes() {
    let block = single_column_block(
        "id",
        "UInt32",
        &[Value::UInt(1), Value::UInt(2), Value::UInt(3)],
    );
    let bytes = encode_block(&block).unwrap();

    let mut expected = vec![0x01, 0x03];
    expected.extend_from_slice(&[0x02, b'i', b'd']);
    expected.extend_from_slice(&[0x06]);
    expected.extend_from_slice(b"UInt32");
    expected.push(0x00); // dense kind, no prefix before it
    for v in [1u32, 2, 3] {
        expected.extend_from_slice(&v.to_le_bytes());
    }
    assert_eq!(&bytes[..], &expected[..]);

    let decoded = decode(&bytes);
    assert_eq!(decoded.row_count(), 3);
    assert_eq!(decoded.column(0).unwrap().data.get(0), Value::UInt(1));
}

#[test]
fn nullable_string_payload_bytes() {
    let block = single_column_block(
        "s",
        "Nullable(String)",
        &["a".into(), Value::Null, "c".into()],
    );
    let bytes = encode_block(&block).unwrap();

    // Skip header + column header + 2 kind bytes, check the payload:
    // null flags then the varint-string stream with an empty placeholder.
    let payload = &bytes[bytes.len() - 8..];
    assert_eq!(
        payload,
        &[0x00, 0x01, 0x00, 0x01, b'a', 0x00, 0x01, b'c']
    );

    let decoded = decode(&bytes);
    assert_eq!(decoded.column(0).unwrap().data.get(1), Value::Null);
}

#[test]
fn variant_block_bytes() {
    let codec = get_codec("Variant(String, Int64)").unwrap();
    let variant =
        codec.as_any().downcast_ref::<VariantCodec>().unwrap();
    let col = variant
        .from_pairs(&[
            (Some(0), "hi".into()),
            (Some(1), Value::Int(7)),
            (None, Value::Null),
        ])
        .unwrap();
    let mut block = Block::new();
    block
        .append_column("v", "Variant(String, Int64)", col)
        .unwrap();
    let bytes = encode_block(&block).unwrap();

    let mut expected = vec![0x01, 0x03];
    expected.extend_from_slice(&[0x01, b'v']);
    expected.push(22);
    expected.extend_from_slice(b"Variant(String, Int64)");
    expected.extend_from_slice(&0u64.to_le_bytes()); // BASIC mode prefix
    expected.extend_from_slice(&[0x00, 0x00, 0x00]); // kind tree
    expected.extend_from_slice(&[0x00, 0x01, 0xFF]); // discriminators
    expected.extend_from_slice(&[0x02, b'h', b'i']); // String group
    expected.extend_from_slice(&7u64.to_le_bytes()); // Int64 group
    assert_eq!(&bytes[..], &expected[..]);

    let decoded = decode(&bytes);
    let data = &decoded.column(0).unwrap().data;
    assert_eq!(data.get(0), "hi".into());
    assert_eq!(data.get(1), Value::Int(7));
    assert_eq!(data.get(2), Value::Null);
    assert_eq!(encode_block(&decoded).unwrap(), bytes);
}

#[test]
fn low_cardinality_block_bytes() {
    let block = single_column_block(
        "k",
        "LowCardinality(String)",
        &["x".into(), "y".into(), "x".into(), "x".into()],
    );
    let bytes = encode_block(&block).unwrap();

    let mut expected = vec![0x01, 0x04];
    expected.extend_from_slice(&[0x01, b'k']);
    expected.push(22);
    expected.extend_from_slice(b"LowCardinality(String)");
    expected.extend_from_slice(&1u64.to_le_bytes()); // version prefix
    expected.push(0x00); // dense kind
    expected.extend_from_slice(&(1u64 << 9).to_le_bytes()); // flags: keys | u8
    expected.extend_from_slice(&2u64.to_le_bytes()); // dict size
    expected.extend_from_slice(&[0x01, b'x', 0x01, b'y']);
    expected.extend_from_slice(&4u64.to_le_bytes()); // row count
    expected.extend_from_slice(&[0x00, 0x01, 0x00, 0x00]); // indices
    assert_eq!(&bytes[..], &expected[..]);

    let decoded = decode(&bytes);
    assert_eq!(
        decoded.column(0).unwrap().data.materialize(),
        vec![
            Value::from("x"),
            Value::from("y"),
            Value::from("x"),
            Value::from("x")
        ]
    );
    assert_eq!(encode_block(&decoded).unwrap(), bytes);
}

#[test]
fn scalar_type_matrix_roundtrips() {
    assert_roundtrip("UInt8", vec![Value::UInt(0), Value::UInt(255)]);
    assert_roundtrip("UInt16", vec![Value::UInt(65535)]);
    assert_roundtrip("UInt64", vec![Value::UInt(u64::MAX)]);
    assert_roundtrip("Int8", vec![Value::Int(-128), Value::Int(127)]);
    assert_roundtrip("Int64", vec![Value::Int(i64::MIN)]);
    assert_roundtrip(
        "Int128",
        vec![Value::Int128(i128::MIN), Value::Int128(0)],
    );
    assert_roundtrip("UInt128", vec![Value::UInt128(u128::MAX)]);
    assert_roundtrip(
        "Int256",
        vec![
            Value::Int256((-42i128).into()),
            Value::Int256(i128::MAX.into()),
        ],
    );
    assert_roundtrip(
        "UInt256",
        vec![Value::UInt256(7u128.into()), Value::UInt256(u128::MAX.into())],
    );
    assert_roundtrip(
        "Float32",
        vec![Value::Float(1.5), Value::Float(-0.25)],
    );
    assert_roundtrip("Float64", vec![Value::Float(std::f64::consts::PI)]);
    assert_roundtrip("Bool", vec![Value::Bool(true), Value::Bool(false)]);
    assert_roundtrip("String", vec!["".into(), "héllo".into()]);
    assert_roundtrip(
        "FixedString(4)",
        vec![Value::Bytes(b"abcd".to_vec()), Value::Bytes(b"ab\0\0".to_vec())],
    );
    assert_roundtrip(
        "UUID",
        vec![Value::Uuid(
            uuid::Uuid::parse_str("00112233-4455-6677-8899-aabbccddeeff")
                .unwrap(),
        )],
    );
    assert_roundtrip(
        "IPv4",
        vec![Value::Ipv4("192.168.1.1".parse().unwrap())],
    );
    assert_roundtrip(
        "IPv6",
        vec![Value::Ipv6("2001:db8::1".parse().unwrap())],
    );
    assert_roundtrip(
        "Date",
        vec![Value::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())],
    );
    assert_roundtrip(
        "Date32",
        vec![Value::Date(NaiveDate::from_ymd_opt(1925, 1, 1).unwrap())],
    );
    assert_roundtrip(
        "DateTime",
        vec![Value::DateTime(
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        )],
    );
    assert_roundtrip(
        "DateTime64(3)",
        vec![Value::DateTime(
            DateTime::from_timestamp(1_700_000_000, 123_000_000).unwrap(),
        )],
    );
    assert_roundtrip(
        "Decimal(9, 2)",
        vec![Value::Decimal(Decimal::new(-12345, 2))],
    );
    assert_roundtrip(
        "Decimal(18, 4)",
        vec![Value::Decimal(Decimal::new(99999999, 4))],
    );
    assert_roundtrip(
        "Decimal(38, 10)",
        vec![Value::Decimal(Decimal::new(
            123456789012345678901234567i128,
            10,
        ))],
    );
    assert_roundtrip(
        "Decimal256(10)",
        vec![Value::Decimal(Decimal::new(-1234567890i128, 10))],
    );
    assert_roundtrip(
        "Enum8('red' = 1, 'green' = 2)",
        vec!["red".into(), "green".into()],
    );
    assert_roundtrip(
        "Enum16('on' = 100, 'off' = -100)",
        vec!["off".into(), "on".into()],
    );
}

#[test]
fn composite_type_matrix_roundtrips() {
    assert_roundtrip(
        "Nullable(UInt32)",
        vec![Value::UInt(1), Value::Null, Value::UInt(3)],
    );
    assert_roundtrip(
        "Array(Int8)",
        vec![
            Value::Array(vec![Value::Int(1), Value::Int(2)]),
            Value::Array(vec![]),
            Value::Array(vec![Value::Int(3)]),
        ],
    );
    assert_roundtrip(
        "Array(Nullable(String))",
        vec![Value::Array(vec!["a".into(), Value::Null])],
    );
    assert_roundtrip(
        "Map(String, UInt32)",
        vec![
            Value::Map(vec![
                ("a".into(), Value::UInt(1)),
                ("b".into(), Value::UInt(2)),
            ]),
            Value::Map(vec![]),
        ],
    );
    assert_roundtrip(
        "Tuple(UInt8, String)",
        vec![Value::Tuple(vec![Value::UInt(1), "x".into()])],
    );
    assert_roundtrip(
        "Tuple(id UInt64, tags Array(String))",
        vec![Value::Tuple(vec![
            Value::UInt(9),
            Value::Array(vec!["t".into()]),
        ])],
    );
    assert_roundtrip(
        "Nested(a UInt8, b String)",
        vec![Value::Array(vec![
            Value::Tuple(vec![Value::UInt(1), "x".into()]),
            Value::Tuple(vec![Value::UInt(2), "y".into()]),
        ])],
    );
    assert_roundtrip(
        "LowCardinality(String)",
        vec!["x".into(), "y".into(), "x".into()],
    );
    assert_roundtrip(
        "LowCardinality(Nullable(String))",
        vec!["x".into(), Value::Null, "x".into()],
    );
    assert_roundtrip(
        "Array(LowCardinality(String))",
        vec![Value::Array(vec!["a".into(), "a".into(), "b".into()])],
    );
    assert_roundtrip(
        "Dynamic",
        vec![Value::Int(1), "x".into(), Value::Null, Value::Float(0.5)],
    );
    assert_roundtrip(
        "JSON",
        vec![
            Value::Map(vec![
                ("a".into(), Value::Int(1)),
                ("b".into(), "x".into()),
            ]),
            Value::Map(vec![("b".into(), "y".into())]),
        ],
    );
    assert_roundtrip(
        "Point",
        vec![Value::Tuple(vec![Value::Float(1.0), Value::Float(2.0)])],
    );
}

#[test]
fn zero_row_blocks_roundtrip() {
    for ty in [
        "UInt32",
        "String",
        "Nullable(String)",
        "Array(Int8)",
        "Map(String, UInt32)",
        "LowCardinality(String)",
        "Variant(String, Int64)",
        "Dynamic",
        "JSON",
    ] {
        assert_roundtrip(ty, vec![]);
    }
}

#[test]
fn multi_column_rows_roundtrip() {
    let schema = vec![
        SchemaColumn::new("id", "UInt64"),
        SchemaColumn::new("name", "Nullable(String)"),
        SchemaColumn::new("tags", "Array(String)"),
        SchemaColumn::new("attrs", "Map(String, UInt32)"),
    ];
    let rows = vec![
        vec![
            Value::UInt(1),
            "alice".into(),
            Value::Array(vec!["x".into()]),
            Value::Map(vec![("k".into(), Value::UInt(1))]),
        ],
        vec![
            Value::UInt(2),
            Value::Null,
            Value::Array(vec![]),
            Value::Map(vec![]),
        ],
    ];

    let block = table_from_rows(&schema, &rows).unwrap();
    let bytes = encode_block(&block).unwrap();
    let decoded = decode(&bytes);
    assert_eq!(to_array_rows(&decoded), rows);
}

#[test]
fn map_as_array_option_materializes_pairs() {
    let block = single_column_block(
        "m",
        "Map(String, UInt32)",
        &[Value::Map(vec![
            ("k".into(), Value::UInt(1)),
            ("k".into(), Value::UInt(2)),
        ])],
    );
    let bytes = encode_block(&block).unwrap();

    let mut r = Reader::new(&bytes);
    let options = DecodeOptions { map_as_array: true };
    let decoded = decode_block(&mut r, &options).unwrap().unwrap();
    assert_eq!(
        decoded.column(0).unwrap().data.get(0),
        Value::Array(vec![
            Value::Tuple(vec!["k".into(), Value::UInt(1)]),
            Value::Tuple(vec!["k".into(), Value::UInt(2)]),
        ])
    );
}

#[test]
fn decode_all_merges_and_skips_end_markers() {
    let first = single_column_block(
        "id",
        "UInt32",
        &[Value::UInt(1), Value::UInt(2)],
    );
    let second = single_column_block("id", "UInt32", &[Value::UInt(3)]);

    let mut bytes = Vec::new();
    bytes.extend_from_slice(&encode_block(&first).unwrap());
    bytes.extend_from_slice(&clickhouse_native_format::end_marker());
    bytes.extend_from_slice(&encode_block(&second).unwrap());
    bytes.extend_from_slice(&clickhouse_native_format::end_marker());

    let merged = decode_all(&bytes, &DecodeOptions::default()).unwrap();
    assert_eq!(merged.row_count(), 3);
    assert_eq!(
        merged.column(0).unwrap().data.materialize(),
        vec![Value::UInt(1), Value::UInt(2), Value::UInt(3)]
    );
}

#[test]
fn dynamic_blocks_with_different_types_merge() {
    let first = single_column_block("d", "Dynamic", &[Value::Int(1)]);
    let second = single_column_block("d", "Dynamic", &["x".into()]);

    let mut bytes = Vec::new();
    bytes.extend_from_slice(&encode_block(&first).unwrap());
    bytes.extend_from_slice(&encode_block(&second).unwrap());

    let merged = decode_all(&bytes, &DecodeOptions::default()).unwrap();
    assert_eq!(
        merged.column(0).unwrap().data.materialize(),
        vec![Value::Int(1), "x".into()]
    );
}

#[test]
fn sparse_column_reconstructs_dense_values() {
    // Hand-built block: one UInt32 column whose kind tree says Sparse.
    // Six rows with non-defaults at positions 1 and 3.
    let mut bytes = vec![0x01, 0x06];
    bytes.extend_from_slice(&[0x01, b'c']);
    bytes.extend_from_slice(&[0x06]);
    bytes.extend_from_slice(b"UInt32");
    bytes.push(0x01); // sparse kind
    bytes.push(1); // one default before the first value
    bytes.push(1); // one default between values
    // Trailing defaults terminator: varint of END_OF_GRANULE_FLAG | 2.
    let mut terminator = (1u64 << 62) | 2;
    while terminator >= 0x80 {
        bytes.push((terminator & 0x7F) as u8 | 0x80);
        terminator >>= 7;
    }
    bytes.push(terminator as u8);
    bytes.extend_from_slice(&7u32.to_le_bytes());
    bytes.extend_from_slice(&9u32.to_le_bytes());

    let decoded = decode(&bytes);
    assert_eq!(
        decoded.column(0).unwrap().data.materialize(),
        vec![
            Value::UInt(0),
            Value::UInt(7),
            Value::UInt(0),
            Value::UInt(9),
            Value::UInt(0),
            Value::UInt(0),
        ]
    );
}

#[test]
fn decimal_values_render_precisely() {
    let block = single_column_block(
        "d",
        "Decimal(9, 2)",
        &[Value::Decimal(Decimal::new(-12345, 2))],
    );
    let bytes = encode_block(&block).unwrap();
    let decoded = decode(&bytes);
    assert_eq!(
        decoded.column(0).unwrap().data.get(0).to_string(),
        "-123.45"
    );
}
