//! Builders for BigQuery table schema fields.

use serde::{Deserialize, Serialize};

use crate::bail;
use crate::error::{BqResult, ErrorKind};

/// Column type of a schema field.
///
/// Types without a builder are kept verbatim in [`FieldType::Other`] so schemas read from
/// JSON are sent back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    Integer,
    Float,
    String,
    Record,
    Timestamp,
    Other(String),
}

impl FieldType {
    pub fn as_str(&self) -> &str {
        match self {
            FieldType::Integer => "INTEGER",
            FieldType::Float => "FLOAT",
            FieldType::String => "STRING",
            FieldType::Record => "RECORD",
            FieldType::Timestamp => "TIMESTAMP",
            FieldType::Other(field_type) => field_type,
        }
    }
}

impl From<String> for FieldType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "INTEGER" => FieldType::Integer,
            "FLOAT" => FieldType::Float,
            "STRING" => FieldType::String,
            "RECORD" => FieldType::Record,
            "TIMESTAMP" => FieldType::Timestamp,
            _ => FieldType::Other(value),
        }
    }
}

impl From<FieldType> for String {
    fn from(value: FieldType) -> Self {
        match value {
            FieldType::Other(field_type) => field_type,
            known => known.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldMode {
    Nullable,
    Required,
    Repeated,
}

/// A field of a table schema (the REST `TableFieldSchema` resource).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableFieldSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<FieldMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<TableFieldSchema>>,
}

impl TableFieldSchema {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            mode: None,
            description: None,
            fields: None,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::String)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Integer)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Float)
    }

    pub fn timestamp(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Timestamp)
    }

    /// Creates a `RECORD` field nesting `fields`.
    ///
    /// Fails with [`ErrorKind::Schema`] when `fields` is empty since BigQuery rejects
    /// records without sub-fields.
    pub fn record(name: impl Into<String>, fields: Vec<TableFieldSchema>) -> BqResult<Self> {
        let name = name.into();
        if fields.is_empty() {
            bail!(
                ErrorKind::Schema,
                "Record field must have at least one sub-field",
                name
            );
        }

        let mut field = Self::new(name, FieldType::Record);
        field.fields = Some(fields);

        Ok(field)
    }

    pub fn with_mode(mut self, mode: FieldMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
