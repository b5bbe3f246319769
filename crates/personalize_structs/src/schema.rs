//! Avro schema definitions registered for each dataset type.

use serde::{Deserialize, Serialize};

use crate::DatasetType;

/// Namespace the service requires for dataset schemas.
pub const SCHEMA_NAMESPACE: &str = "com.amazonaws.personalize.schema";

/// Avro primitive types used by the retail schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvroType {
    String,
    Int,
    Long,
}

/// A single field of an Avro record schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,

    #[serde(rename = "type")]
    pub field_type: AvroType,

    /// Marks a string field as a categorical feature.
    #[serde(default, skip_serializing_if = "core::ops::Not::not")]
    pub categorical: bool,

    /// Marks a string field as unstructured text.
    #[serde(default, skip_serializing_if = "core::ops::Not::not")]
    pub textual: bool,
}

impl SchemaField {
    fn plain(name: &str, field_type: AvroType) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            categorical: false,
            textual: false,
        }
    }

    fn categorical(name: &str) -> Self {
        Self {
            categorical: true,
            ..Self::plain(name, AvroType::String)
        }
    }

    fn textual(name: &str) -> Self {
        Self {
            textual: true,
            ..Self::plain(name, AvroType::String)
        }
    }
}

/// Avro record schema as accepted by schema creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSchema {
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub namespace: String,
    pub fields: Vec<SchemaField>,
    pub version: String,
}

impl DatasetSchema {
    /// Returns the schema for a dataset type.
    #[must_use]
    pub fn for_dataset(dataset_type: DatasetType) -> Self {
        let (name, fields) = match dataset_type {
            DatasetType::Interactions => (
                "Interactions",
                vec![
                    SchemaField::plain("ITEM_ID", AvroType::String),
                    SchemaField::plain("USER_ID", AvroType::String),
                    SchemaField::plain("EVENT_TYPE", AvroType::String),
                    SchemaField::plain("TIMESTAMP", AvroType::Long),
                    SchemaField::categorical("DISCOUNT"),
                ],
            ),
            DatasetType::Items => (
                "Items",
                vec![
                    SchemaField::plain("ITEM_ID", AvroType::String),
                    SchemaField::categorical("CATEGORY"),
                    SchemaField::categorical("STYLE"),
                    SchemaField::textual("DESCRIPTION"),
                ],
            ),
            DatasetType::Users => (
                "Users",
                vec![
                    SchemaField::plain("USER_ID", AvroType::String),
                    SchemaField::plain("AGE", AvroType::Int),
                    SchemaField::categorical("GENDER"),
                ],
            ),
        };

        Self {
            record_type: "record".to_string(),
            name: name.to_string(),
            namespace: SCHEMA_NAMESPACE.to_string(),
            fields,
            version: "1.0".to_string(),
        }
    }

    /// Serializes the schema to the JSON document sent to the service.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Returns the names of all fields in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|field| field.name.as_str())
    }
}
