//! Generator configuration (apigen.toml)
//!
//! Every field has a default, so an empty file is a valid configuration.
//! Relative paths are resolved against the directory holding the file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while loading the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read or write the configuration file
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize TOML
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// Validation error
    #[error("Invalid config: {0}")]
    ValidationError(String),
}

/// Calling convention of every exported function and function pointer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallingConvention {
    #[default]
    Cdecl,
    StdCall,
}

impl CallingConvention {
    /// `System.Runtime.InteropServices.CallingConvention` member
    pub fn csharp(self) -> &'static str {
        match self {
            CallingConvention::Cdecl => "CallingConvention.Cdecl",
            CallingConvention::StdCall => "CallingConvention.StdCall",
        }
    }

    /// MSVC keyword
    pub fn msvc(self) -> &'static str {
        match self {
            CallingConvention::Cdecl => "__cdecl",
            CallingConvention::StdCall => "__stdcall",
        }
    }
}

/// Generator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Schema file (.toml or .json)
    #[serde(default = "default_schema")]
    pub schema: PathBuf,

    /// Managed (C#) output settings
    #[serde(default)]
    pub managed: ManagedConfig,

    /// Native (C++) output settings
    #[serde(default)]
    pub native: NativeConfig,

    /// Formatting shared by every emitted file
    #[serde(default)]
    pub output: OutputConfig,
}

/// `[managed]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagedConfig {
    /// Output directory for `{Type}.cs` and `NativeTypes.cs`
    #[serde(default = "default_managed_dir")]
    pub dir: PathBuf,

    /// Namespace of the generated classes
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Library name passed to `[DllImport]`
    #[serde(default = "default_native_module")]
    pub native_module: String,

    /// Hand-written managed base class of root API classes
    #[serde(default = "default_object_class")]
    pub object_class: String,
}

/// `[native]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeConfig {
    /// Output directory for headers, `.inc` files and scaffolds
    #[serde(default = "default_native_dir")]
    pub dir: PathBuf,

    #[serde(default)]
    pub calling_convention: CallingConvention,
}

/// `[output]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Comment placed at the top of every generated file
    #[serde(default = "default_header")]
    pub header: String,

    /// Spaces per indentation level
    #[serde(default = "default_indent")]
    pub indent: usize,
}

fn default_schema() -> PathBuf {
    PathBuf::from("api.toml")
}

fn default_managed_dir() -> PathBuf {
    PathBuf::from("managed")
}

fn default_native_dir() -> PathBuf {
    PathBuf::from("native")
}

fn default_namespace() -> String {
    "Native".to_string()
}

fn default_native_module() -> String {
    "NativeApi".to_string()
}

fn default_object_class() -> String {
    "NativeObject".to_string()
}

fn default_header() -> String {
    "<auto-generated> Generated by apigen. DO NOT MODIFY MANUALLY. </auto-generated>".to_string()
}

fn default_indent() -> usize {
    4
}

impl Default for ManagedConfig {
    fn default() -> Self {
        Self {
            dir: default_managed_dir(),
            namespace: default_namespace(),
            native_module: default_native_module(),
            object_class: default_object_class(),
        }
    }
}

impl Default for NativeConfig {
    fn default() -> Self {
        Self {
            dir: default_native_dir(),
            calling_convention: CallingConvention::default(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            header: default_header(),
            indent: default_indent(),
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            schema: default_schema(),
            managed: ManagedConfig::default(),
            native: NativeConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl GeneratorConfig {
    /// Parse a config file and anchor its relative paths at the file's directory
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_str(&content)?;
        if let Some(base) = path.parent() {
            config.rebase(base);
        }
        Ok(config)
    }

    /// Parse a config from a string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: GeneratorConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the config
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_namespace(&self.managed.namespace) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid managed namespace: {}. Must be dot-separated identifiers",
                self.managed.namespace
            )));
        }

        if self.managed.native_module.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "Native module name cannot be empty".to_string(),
            ));
        }

        if !is_identifier(&self.managed.object_class) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid object class name: {}",
                self.managed.object_class
            )));
        }

        if self.output.indent == 0 || self.output.indent > 8 {
            return Err(ConfigError::ValidationError(format!(
                "Indent must be between 1 and 8 spaces, got {}",
                self.output.indent
            )));
        }

        Ok(())
    }

    /// Write config to a file
    pub fn to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Resolve relative paths against `base`
    pub fn rebase(&mut self, base: &Path) {
        for path in [&mut self.schema, &mut self.managed.dir, &mut self.native.dir] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }

    /// Header comment lines, each without the comment marker
    pub fn header_lines(&self) -> impl Iterator<Item = &str> {
        self.output.header.lines()
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => chars.all(|c| c.is_alphanumeric() || c == '_'),
        _ => false,
    }
}

fn is_valid_namespace(namespace: &str) -> bool {
    namespace.split('.').all(is_identifier)
}
