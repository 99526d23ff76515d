//! Value/BSON translation
//!
//! Keeps the portable `Value`/`Record`/`Filter` types out of the BSON
//! namespace and vice versa. Lossy in one documented spot: BSON types with no
//! portable counterpart (object ids, timestamps, decimals) come back through
//! their relaxed extended-JSON rendering.

use mongodb::bson::spec::BinarySubtype;
use mongodb::bson::{Binary, Bson, Document};

use polystore_core::error::{AdapterError, AdapterResult};
use polystore_core::value::{Filter, Record, Value};

/// Convert a portable value to BSON.
pub fn value_to_bson(value: &Value) -> Bson {
    match value {
        Value::Null => Bson::Null,
        Value::Boolean(b) => Bson::Boolean(*b),
        Value::Integer(i) => Bson::Int64(*i),
        Value::Float(f) => Bson::Double(*f),
        Value::String(s) => Bson::String(s.clone()),
        Value::Binary(bytes) => Bson::Binary(Binary {
            subtype: BinarySubtype::Generic,
            bytes: bytes.clone(),
        }),
        Value::Array(values) => Bson::Array(values.iter().map(value_to_bson).collect()),
        Value::Object(map) => {
            let mut doc = Document::new();
            for (key, raw) in map {
                doc.insert(key.clone(), value_to_bson(&Value::from_json(raw.clone())));
            }
            Bson::Document(doc)
        }
    }
}

/// Convert BSON to a portable value.
pub fn bson_to_value(bson: Bson) -> Value {
    match bson {
        Bson::Null => Value::Null,
        Bson::Boolean(b) => Value::Boolean(b),
        Bson::Int32(i) => Value::Integer(i64::from(i)),
        Bson::Int64(i) => Value::Integer(i),
        Bson::Double(f) => Value::Float(f),
        Bson::String(s) => Value::String(s),
        Bson::Binary(binary) => Value::Binary(binary.bytes),
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::Array(items) => Value::Array(items.into_iter().map(bson_to_value).collect()),
        Bson::Document(doc) => {
            let mut map = serde_json::Map::with_capacity(doc.len());
            for (key, raw) in doc {
                map.insert(key, bson_to_value(raw).to_json());
            }
            Value::Object(map)
        }
        other => Value::from_json(other.into_relaxed_extjson()),
    }
}

/// Convert a portable record to a BSON document.
pub fn record_to_document(record: &Record) -> Document {
    let mut doc = Document::new();
    for (field, value) in record.iter() {
        doc.insert(field.clone(), value_to_bson(value));
    }
    doc
}

/// Convert a BSON document to a portable record.
pub fn document_to_record(doc: Document) -> Record {
    doc.into_iter()
        .map(|(field, raw)| (field, bson_to_value(raw)))
        .collect()
}

/// Convert an equality filter to a BSON query document.
pub fn filter_to_document(filter: &Filter) -> Document {
    let mut doc = Document::new();
    for (field, value) in filter.iter() {
        doc.insert(field.clone(), value_to_bson(value));
    }
    doc
}

/// Build a `$set` update document, rejecting an empty change set.
pub fn changes_to_update(changes: &Record) -> AdapterResult<Document> {
    if changes.is_empty() {
        return Err(AdapterError::operation_failed(
            "update requires at least one field to change",
        ));
    }
    let mut update = Document::new();
    update.insert("$set", record_to_document(changes));
    Ok(update)
}
