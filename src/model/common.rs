use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type Id = String;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum DataType {
    String,
    Number,
    Boolean,
    Date,
    Url,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedValue {
    pub value: serde_json::Value,
    #[serde(rename = "type")]
    pub data_type: DataType,
}

impl TypedValue {
    pub fn string(value: String) -> Self {
        Self {
            value: serde_json::Value::String(value),
            data_type: DataType::String,
        }
    }

    pub fn number(value: i64) -> Self {
        Self {
            value: serde_json::Value::Number(serde_json::Number::from(value)),
            data_type: DataType::Number,
        }
    }

    pub fn boolean(value: bool) -> Self {
        Self {
            value: serde_json::Value::Bool(value),
            data_type: DataType::Boolean,
        }
    }
}

/// A named attribute value carried by a versioned snapshot.
///
/// Attribute lists are replaced wholesale on update; there is no per-attribute
/// patching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceAttribute {
    pub name: String,
    #[serde(flatten)]
    pub value: TypedValue,
}

impl InstanceAttribute {
    pub fn new(name: impl Into<String>, value: TypedValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

pub fn generate_id() -> Id {
    Uuid::new_v4().to_string()
}
