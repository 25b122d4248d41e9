//! JSON codec (flattened, path-indexed, version 3).
//!
//! Prefix: u64 version (`3`), varint path count, the path strings, then
//! one Dynamic prefix per path. Payload: one Dynamic payload per path, in
//! path order. Build mode collects the union of keys across the input
//! objects, sorts them, and builds one Dynamic column per path with
//! missing values as null.

use super::{
    Codec,
    DecodeState,
    DynamicCodec,
    JsonPrefix,
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
    JsonColumn,
};
use crate::types::Type;
use crate::value::Value;
use crate::{
    Error,
    Result,
};
use std::collections::BTreeSet;

const JSON_VERSION: u64 = 3;

pub(crate) struct JsonCodec {
    ty: Type,
    dynamic: DynamicCodec,
}

impl JsonCodec {
    pub(crate) fn new() -> Self {
        Self { ty: Type::Json, dynamic: DynamicCodec::new() }
    }

    fn unwrap_column<'c>(&self, col: &'c Column) -> Result<&'c JsonColumn> {
        match col {
            Column::Json(col) => Ok(col),
            other => Err(Error::TypeMismatch {
                expected: "JSON".to_string(),
                actual: other.kind_name().to_string(),
            }),
        }
    }
}

impl Codec for JsonCodec {
    fn data_type(&self) -> &Type {
        &self.ty
    }

    fn zero_value(&self) -> Value {
        Value::Map(Vec::new())
    }

    fn estimate_size(&self, rows: usize) -> usize {
        rows * 32
    }

    fn write_prefix(&self, w: &mut Writer, col: &Column) -> Result<()> {
        let col = self.unwrap_column(col)?;
        w.write_u64_le(JSON_VERSION);
        w.write_varint(col.paths.len() as u64);
        for path in &col.paths {
            w.write_string(path);
        }
        for column in &col.columns {
            self.dynamic.write_prefix(w, column)?;
        }
        Ok(())
    }

    fn read_prefix(&self, r: &mut Reader<'_>) -> Result<Prefix> {
        let version = r.read_u64_le()?;
        if version != JSON_VERSION {
            return Err(Error::UnsupportedVersion {
                what: "JSON",
                expected: JSON_VERSION,
                got: version,
            });
        }
        let count = r.read_varint()? as usize;
        let mut paths = Vec::with_capacity(count);
        for _ in 0..count {
            paths.push(r.read_string()?);
        }
        let children = (0..count)
            .map(|_| self.dynamic.read_prefix(r))
            .collect::<Result<_>>()?;
        Ok(Prefix::Json(JsonPrefix { paths, children }))
    }

    fn write_kinds(&self, w: &mut Writer, col: &Column) -> Result<()> {
        let col = self.unwrap_column(col)?;
        w.write_u8(SERIALIZATION_KIND_DENSE);
        for column in &col.columns {
            self.dynamic.write_kinds(w, column)?;
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
            Prefix::Json(jp) => jp
                .children
                .iter()
                .map(|child| self.dynamic.read_kinds(r, child))
                .collect::<Result<_>>()?,
            _ => Vec::new(),
        };
        Ok(SerKind { kind, children, resume: Default::default() })
    }

    fn encode(&self, col: &Column, w: &mut Writer) -> Result<()> {
        let col = self.unwrap_column(col)?;
        for column in &col.columns {
            self.dynamic.encode(column, w)?;
        }
        Ok(())
    }

    fn decode_dense(
        &self,
        r: &mut Reader<'_>,
        rows: usize,
        state: &mut DecodeState<'_>,
    ) -> Result<Column> {
        let jp: &JsonPrefix = match state.prefix {
            Prefix::Json(jp) => jp,
            _ => {
                return Err(Error::Protocol(
                    "JSON payload without a JSON prefix".to_string(),
                ))
            }
        };
        let mut columns = Vec::with_capacity(jp.paths.len());
        for (j, child_prefix) in jp.children.iter().enumerate() {
            let mut child = DecodeState {
                prefix: child_prefix,
                kinds: state.kinds.child_mut(j),
                options: state.options,
            };
            columns.push(self.dynamic.decode(r, rows, &mut child)?);
        }
        Ok(Column::Json(Box::new(JsonColumn {
            paths: jp.paths.clone(),
            columns,
            len: rows,
        })))
    }

    fn from_values(&self, values: &[Value]) -> Result<Column> {
        // Union of keys across all objects, sorted.
        let mut paths: BTreeSet<String> = BTreeSet::new();
        for value in values {
            match value {
                Value::Map(pairs) => {
                    for (key, _) in pairs {
                        match key {
                            Value::String(key) => {
                                paths.insert(key.clone());
                            }
                            other => {
                                return Err(Error::TypeMismatch {
                                    expected: "String object key"
                                        .to_string(),
                                    actual: other.kind_name().to_string(),
                                })
                            }
                        }
                    }
                }
                other => {
                    return Err(Error::TypeMismatch {
                        expected: "JSON object".to_string(),
                        actual: other.kind_name().to_string(),
                    })
                }
            }
        }

        let paths: Vec<String> = paths.into_iter().collect();
        let mut columns = Vec::with_capacity(paths.len());
        for path in &paths {
            let path_values: Vec<Value> = values
                .iter()
                .map(|value| match value {
                    Value::Map(pairs) => pairs
                        .iter()
                        .rev()
                        .find(|(key, _)| key.as_str() == Some(path.as_str()))
                        .map(|(_, v)| v.clone())
                        .unwrap_or(Value::Null),
                    _ => Value::Null,
                })
                .collect();
            columns.push(self.dynamic.from_values(&path_values)?);
        }
        Ok(Column::Json(Box::new(JsonColumn {
            paths,
            columns,
            len: values.len(),
        })))
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::DecodeOptions;

    fn object(pairs: &[(&str, Value)]) -> Value {
        Value::Map(
            pairs
                .iter()
                .map(|(k, v)| (Value::String(k.to_string()), v.clone()))
                .collect(),
        )
    }

    fn roundtrip(values: Vec<Value>) -> (Column, Vec<Value>) {
        let codec = JsonCodec::new();
        let col = codec.from_values(&values).unwrap();

        let mut prefix_w = Writer::new();
        codec.write_prefix(&mut prefix_w, &col).unwrap();
        let prefix_buf = prefix_w.finish();

        let mut payload_w = Writer::new();
        codec.encode(&col, &mut payload_w).unwrap();
        let payload_buf = payload_w.finish();

        let mut prefix_r = Reader::new(&prefix_buf);
        let prefix = codec.read_prefix(&mut prefix_r).unwrap();
        assert_eq!(prefix_r.remaining(), 0);

        let mut r = Reader::new(&payload_buf);
        let mut kinds = SerKind::dense();
        let options = DecodeOptions::default();
        let mut state = DecodeState::new(&prefix, &mut kinds, &options);
        let decoded =
            codec.decode_dense(&mut r, values.len(), &mut state).unwrap();
        assert_eq!(r.remaining(), 0);
        let materialized = decoded.materialize();
        (decoded, materialized)
    }

    #[test]
    fn test_paths_are_sorted_union() {
        let values = vec![
            object(&[("b", Value::Int(1)), ("a", "x".into())]),
            object(&[("c", Value::Float(0.5))]),
        ];
        let (col, materialized) = roundtrip(values);
        match &col {
            Column::Json(col) => {
                assert_eq!(
                    col.paths,
                    vec!["a".to_string(), "b".to_string(), "c".to_string()]
                );
            }
            other => panic!("expected json, got {:?}", other.kind_name()),
        }
        // Missing paths are absent from the materialized object.
        assert_eq!(
            materialized[0],
            object(&[("a", "x".into()), ("b", Value::Int(1))])
        );
        assert_eq!(materialized[1], object(&[("c", Value::Float(0.5))]));
    }

    #[test]
    fn test_empty_objects() {
        let (col, materialized) =
            roundtrip(vec![object(&[]), object(&[])]);
        assert_eq!(col.len(), 2);
        assert_eq!(materialized, vec![object(&[]), object(&[])]);
    }

    #[test]
    fn test_from_json_input() {
        let json: serde_json::Value =
            serde_json::from_str(r#"{"id": 7, "tags": ["a", "b"]}"#).unwrap();
        let (_, materialized) = roundtrip(vec![Value::from_json(&json)]);
        assert_eq!(
            materialized[0],
            object(&[
                ("id", Value::Int(7)),
                ("tags", Value::Array(vec!["a".into(), "b".into()])),
            ])
        );
    }

    #[test]
    fn test_non_object_rejected() {
        let codec = JsonCodec::new();
        assert!(codec.from_values(&[Value::Int(1)]).is_err());
    }

    #[test]
    fn test_unsupported_version() {
        let codec = JsonCodec::new();
        let buf = 1u64.to_le_bytes();
        let mut r = Reader::new(&buf);
        assert!(matches!(
            codec.read_prefix(&mut r),
            Err(Error::UnsupportedVersion { what: "JSON", .. })
        ));
    }
}
