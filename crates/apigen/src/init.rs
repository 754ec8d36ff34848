//! Project initialization
//!
//! Writes a starter `apigen.toml` and a sample `api.toml` schema.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::{ConfigError, GeneratorConfig};

/// Errors that can occur during project initialization
#[derive(Debug, Error)]
pub enum InitError {
    /// Configuration already present
    #[error("Project already exists: apigen.toml found in {0}")]
    AlreadyExists(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Config error
    #[error("Config error: {0}")]
    ConfigError(#[from] ConfigError),
}

const SAMPLE_SCHEMA: &str = r#"# API surface exposed across the native boundary.

[[types]]
name = "PointI"
kind = "struct"
fields = [
    { name = "X", type = "int" },
    { name = "Y", type = "int" },
]

[[types]]
name = "Widget"
managed_server = true

[[types.properties]]
name = "Text"
type = "string"
set = true

[[types.methods]]
name = "MoveTo"
parameters = [{ name = "position", type = "PointI" }]

[[types.events]]
name = "Click"
"#;

/// Create `apigen.toml` and `api.toml` in `dir`.
///
/// Returns the paths written. An existing `api.toml` is kept.
pub fn init_project(dir: &Path) -> Result<Vec<PathBuf>, InitError> {
    let config_path = dir.join("apigen.toml");
    if config_path.exists() {
        return Err(InitError::AlreadyExists(dir.display().to_string()));
    }

    fs::create_dir_all(dir)?;

    GeneratorConfig::default().to_file(&config_path)?;
    let mut written = vec![config_path];

    let schema_path = dir.join("api.toml");
    if !schema_path.exists() {
        fs::write(&schema_path, SAMPLE_SCHEMA)?;
        written.push(schema_path);
    }

    Ok(written)
}
