//! External collaborator: the schema validator.
//!
//! A JSON-Schema-draft-07 subset: `type`, `properties`, `required`,
//! `items`, `enum`. No general-purpose JSON-Schema crate is pulled in for
//! this - the subset in scope is narrow enough that a small recursive
//! validator over the crate's own tagged [`Value`] is simpler and keeps the
//! dependency list honest about what is actually used.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    String,
    Number,
    Boolean,
    Null,
    Array,
    Object,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaType {
    Single(PrimitiveType),
    Union(Vec<PrimitiveType>),
}

impl SchemaType {
    fn accepts(&self, value: &Value) -> bool {
        match self {
            SchemaType::Single(ty) => primitive_matches(*ty, value),
            SchemaType::Union(types) => types.iter().any(|ty| primitive_matches(*ty, value)),
        }
    }
}

fn primitive_matches(ty: PrimitiveType, value: &Value) -> bool {
    match (ty, value) {
        (PrimitiveType::String, Value::String(_)) => true,
        (PrimitiveType::Number, Value::Number(_)) => true,
        (PrimitiveType::Boolean, Value::Bool(_)) => true,
        (PrimitiveType::Null, Value::Null) => true,
        (PrimitiveType::Array, Value::Array(_)) => true,
        (PrimitiveType::Object, Value::Object(_)) => true,
        _ => false,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub ty: Option<SchemaType>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Schema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
}

impl Schema {
    /// A schema that accepts anything - used for sources that declare no
    /// constraints, and in tests that don't exercise validation.
    pub fn any() -> Schema {
        Schema::default()
    }
}

#[derive(Debug, Clone)]
pub struct SchemaError {
    pub path: String,
    pub message: String,
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at {}: {}", self.path, self.message)
    }
}

pub fn validate(value: &Value, schema: &Schema, path: &str) -> Result<(), SchemaError> {
    if let Some(ty) = &schema.ty {
        if !ty.accepts(value) {
            return Err(SchemaError {
                path: path.to_string(),
                message: format!("value does not match declared type: {value:?}"),
            });
        }
    }

    if let Some(allowed) = &schema.enum_values {
        if !allowed.contains(value) {
            return Err(SchemaError {
                path: path.to_string(),
                message: "value is not one of the enumerated values".to_string(),
            });
        }
    }

    if !schema.properties.is_empty() || !schema.required.is_empty() {
        let map = match value.as_object() {
            Some(map) => map,
            None => {
                return Err(SchemaError {
                    path: path.to_string(),
                    message: "expected an object".to_string(),
                });
            }
        };
        for field in &schema.required {
            if !map.contains_key(field) || map.get(field).is_some_and(Value::is_null) {
                return Err(SchemaError {
                    path: format!("{path}.{field}"),
                    message: "required field is missing".to_string(),
                });
            }
        }
        for (field, sub_schema) in &schema.properties {
            if let Some(field_value) = map.get(field) {
                validate(field_value, sub_schema, &format!("{path}.{field}"))?;
            }
        }
    }

    if let Some(item_schema) = &schema.items {
        if let Some(items) = value.as_array() {
            for (idx, item) in items.iter().enumerate() {
                validate(item, item_schema, &format!("{path}[{idx}]"))?;
            }
        }
    }

    Ok(())
}
