//! Schema loading (`api.toml` / `api.json`)
//!
//! The schema lists API types in processing order. Loading fills in each
//! member's declaring type and checks the structural rules the emitters
//! rely on; it does not judge whether a type makes a sensible API.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

use super::{ApiType, TypeKind};

/// Errors that can occur while loading a schema
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Failed to read the schema file
    #[error("Failed to read schema file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse schema: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Failed to parse JSON
    #[error("Failed to parse schema: {0}")]
    JsonError(#[from] serde_json::Error),

    /// File extension is neither .toml nor .json
    #[error("Unsupported schema format: {0} (expected .toml or .json)")]
    UnsupportedFormat(String),

    /// A type string could not be parsed
    #[error("Invalid type reference '{text}': {reason}")]
    InvalidTypeRef {
        /// The offending text
        text: String,
        /// Why it was rejected
        reason: String,
    },

    /// Two types share a name
    #[error("Duplicate API type: {0}")]
    DuplicateType(String),

    /// Structural rule violated
    #[error("Invalid schema: {0}")]
    ValidationError(String),
}

/// The full list of API types, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiSchema {
    #[serde(default)]
    pub types: Vec<ApiType>,
}

impl ApiSchema {
    /// Build a schema from already constructed types
    pub fn new(types: Vec<ApiType>) -> Result<Self, SchemaError> {
        let mut schema = Self { types };
        schema.finish()?;
        Ok(schema)
    }

    /// Load a schema file; the format is picked by extension
    pub fn from_file(path: &Path) -> Result<Self, SchemaError> {
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&content),
            Some("json") => Self::from_json_str(&content),
            _ => Err(SchemaError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// Parse a TOML schema
    pub fn from_toml_str(content: &str) -> Result<Self, SchemaError> {
        let mut schema: ApiSchema = toml::from_str(content)?;
        schema.finish()?;
        Ok(schema)
    }

    /// Parse a JSON schema
    pub fn from_json_str(content: &str) -> Result<Self, SchemaError> {
        let mut schema: ApiSchema = serde_json::from_str(content)?;
        schema.finish()?;
        Ok(schema)
    }

    fn finish(&mut self) -> Result<(), SchemaError> {
        self.validate()?;
        for ty in &mut self.types {
            for property in &mut ty.properties {
                property.declaring_type = ty.name.clone();
            }
            for method in &mut ty.methods {
                method.declaring_type = ty.name.clone();
            }
        }
        Ok(())
    }

    /// Check the structural rules
    pub fn validate(&self) -> Result<(), SchemaError> {
        let mut seen = HashSet::new();
        for ty in &self.types {
            if !seen.insert(ty.name.as_str()) {
                return Err(SchemaError::DuplicateType(ty.name.clone()));
            }
        }

        for ty in &self.types {
            let members = !ty.properties.is_empty() || !ty.methods.is_empty() || !ty.events.is_empty();
            match ty.kind {
                TypeKind::Class => {
                    if !ty.fields.is_empty() || !ty.variants.is_empty() {
                        return Err(SchemaError::ValidationError(format!(
                            "Class {} cannot declare fields or variants",
                            ty.name
                        )));
                    }
                }
                TypeKind::Struct => {
                    if members || !ty.variants.is_empty() || ty.managed_server {
                        return Err(SchemaError::ValidationError(format!(
                            "Struct {} may only declare fields",
                            ty.name
                        )));
                    }
                }
                TypeKind::Enum => {
                    if members || !ty.fields.is_empty() || ty.managed_server {
                        return Err(SchemaError::ValidationError(format!(
                            "Enum {} may only declare variants",
                            ty.name
                        )));
                    }
                }
            }

            if ty.flags && !ty.is_enum() {
                return Err(SchemaError::ValidationError(format!(
                    "Only enums can be flags: {}",
                    ty.name
                )));
            }

            if ty.is_enum() {
                ty.resolved_variants()?;
            }
        }

        for ty in self.classes() {
            let mut visited = HashSet::new();
            visited.insert(ty.name.as_str());
            let mut current = self.base_of(ty);
            while let Some(base) = current {
                if !visited.insert(base.name.as_str()) {
                    return Err(SchemaError::ValidationError(format!(
                        "Inheritance cycle through {}",
                        ty.name
                    )));
                }
                current = self.base_of(base);
            }
        }

        Ok(())
    }

    /// Look up a type by name
    pub fn get(&self, name: &str) -> Option<&ApiType> {
        self.types.iter().find(|t| t.name == name)
    }

    /// The base type of `ty`, only when it is itself an API class
    pub fn base_of(&self, ty: &ApiType) -> Option<&ApiType> {
        let base = ty.base.as_deref()?;
        self.get(base).filter(|b| b.is_class())
    }

    /// Classes in processing order
    pub fn classes(&self) -> impl Iterator<Item = &ApiType> {
        self.types.iter().filter(|t| t.is_class())
    }

    /// Structs in processing order
    pub fn structs(&self) -> impl Iterator<Item = &ApiType> {
        self.types.iter().filter(|t| t.is_struct())
    }

    /// Enums in processing order
    pub fn enums(&self) -> impl Iterator<Item = &ApiType> {
        self.types.iter().filter(|t| t.is_enum())
    }
}
