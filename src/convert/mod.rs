//! Bidirectional mapping between typed records and the generic message tree.
//!
//! Typed request/response records never hand-roll wire trees. Instead, one
//! generic engine maps any `Serialize`/`Deserialize` value to and from a
//! [`Section`], driven by the record's serde field metadata: `rename` and
//! `alias` declare wire names (including the daemon's inconsistent
//! hyphen/underscore spellings), `skip_serializing_if` marks optional
//! fields that are omitted when empty, and `default` restores them on the
//! way back. Shape mismatches surface as [`Error::Conversion`], never a
//! panic.

pub mod yes_no;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::protocol::{Node, Section};

/// Convert a typed record (or a string-keyed map of records) into a
/// message tree.
pub fn to_general<T: Serialize>(value: &T) -> Result<Section> {
    let json = serde_json::to_value(value).map_err(conversion_error)?;
    match json {
        Value::Object(map) => object_to_section(map),
        other => Err(Error::Conversion {
            message: format!("top-level value must be a record or map, got {}", kind_of(&other)),
        }),
    }
}

/// Convert a message tree into a typed record.
///
/// Entries the target type does not recognize are ignored for forward
/// compatibility.
pub fn from_general<T: DeserializeOwned>(section: &Section) -> Result<T> {
    let json = Value::Object(section_to_object(section));
    serde_json::from_value(json).map_err(conversion_error)
}

fn conversion_error(e: serde_json::Error) -> Error {
    Error::Conversion {
        message: e.to_string(),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "section",
    }
}

fn object_to_section(map: Map<String, Value>) -> Result<Section> {
    let mut section = Section::new();
    for (name, value) in map {
        match value {
            // Unset optional fields: omitted entirely, not emitted empty.
            Value::Null => continue,
            Value::String(text) => section.insert(name, text),
            Value::Bool(flag) => section.insert(name, if flag { "yes" } else { "no" }),
            Value::Number(number) => section.insert(name, number.to_string()),
            Value::Array(items) => {
                let mut list = Vec::with_capacity(items.len());
                for item in items {
                    list.push(scalar_to_text(&name, item)?);
                }
                section.insert(name, list);
            }
            Value::Object(inner) => {
                let inner = object_to_section(inner)?;
                section.insert(name, inner);
            }
        }
    }
    Ok(section)
}

fn scalar_to_text(name: &str, value: Value) -> Result<String> {
    match value {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(if flag { "yes" } else { "no" }.to_string()),
        other => Err(Error::Conversion {
            message: format!("list '{name}' may only hold scalars, got {}", kind_of(&other)),
        }),
    }
}

fn section_to_object(section: &Section) -> Map<String, Value> {
    let mut map = Map::new();
    for (name, node) in section.iter() {
        let value = match node {
            Node::Text(text) => Value::String(text.clone()),
            Node::List(items) => Value::Array(
                items.iter().map(|item| Value::String(item.clone())).collect(),
            ),
            Node::Section(inner) => Value::Object(section_to_object(inner)),
        };
        map.insert(name.to_string(), value);
    }
    map
}
