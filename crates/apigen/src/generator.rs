//! Generation orchestration
//!
//! [`Generator::plan`] renders every artifact in memory and runs the
//! parity checks; nothing touches the disk until the whole plan succeeded.
//! [`Generator::write`] then applies the plan: generated files are rewritten
//! only when their bytes differ, scaffolds only when absent.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::GeneratorConfig;
use crate::emit::{cabi, managed, native, scaffold, support};
use crate::error::{GenerateError, GenerateResult};
use crate::model::ApiSchema;
use crate::surface::TypeSurface;

/// Emitted artifacts that must list the slot table in order
const SLOT_ARTIFACTS: [&str; 3] = ["native enum", "managed enum", "managed dispatch switch"];

/// How a planned file is treated on write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Owned by the generator, rewritten when stale
    Generated,
    /// Created once for the user to edit
    Scaffold,
}

/// One file the generator intends to produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFile {
    pub path: PathBuf,
    pub kind: FileKind,
    pub content: String,
}

impl PlannedFile {
    fn generated(path: PathBuf, content: String) -> Self {
        Self {
            path,
            kind: FileKind::Generated,
            content,
        }
    }

    fn scaffold(path: PathBuf, content: String) -> Self {
        Self {
            path,
            kind: FileKind::Scaffold,
            content,
        }
    }
}

/// What happened to one planned file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    /// Generated file rewritten with new content
    Written,
    /// Generated file already up to date
    Unchanged,
    /// Scaffold created
    Created,
    /// Scaffold already present, left alone
    Preserved,
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            FileStatus::Written => "written",
            FileStatus::Unchanged => "unchanged",
            FileStatus::Created => "created",
            FileStatus::Preserved => "preserved",
        })
    }
}

/// Outcome of a generation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationReport {
    pub files: Vec<(PathBuf, FileStatus)>,
    pub dry_run: bool,
}

impl GenerationReport {
    pub fn count(&self, status: FileStatus) -> usize {
        self.files.iter().filter(|(_, s)| *s == status).count()
    }

    /// Files whose on-disk state changed (or would change on a dry run)
    pub fn changed(&self) -> impl Iterator<Item = &Path> {
        self.files
            .iter()
            .filter(|(_, s)| matches!(s, FileStatus::Written | FileStatus::Created))
            .map(|(p, _)| p.as_path())
    }

    pub fn status_of(&self, path: &Path) -> Option<FileStatus> {
        self.files.iter().find(|(p, _)| p == path).map(|(_, s)| *s)
    }
}

/// Drives all emitters over one schema.
pub struct Generator {
    config: GeneratorConfig,
    schema: ApiSchema,
}

impl Generator {
    pub fn new(config: GeneratorConfig, schema: ApiSchema) -> Self {
        Self { config, schema }
    }

    /// Load the schema named by the configuration
    pub fn load(config: GeneratorConfig) -> GenerateResult<Self> {
        let schema = ApiSchema::from_file(&config.schema)?;
        info!(schema = %config.schema.display(), types = schema.types.len(), "Loaded schema");
        Ok(Self::new(config, schema))
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn schema(&self) -> &ApiSchema {
        &self.schema
    }

    /// Render every artifact and check that the dialects agree
    pub fn plan(&self) -> GenerateResult<Vec<PlannedFile>> {
        let config = &self.config;
        let schema = &self.schema;
        let native_dir = &config.native.dir;
        let api_dir = native_dir.join("Api");
        let managed_dir = &config.managed.dir;
        let mut files = Vec::new();

        files.push(PlannedFile::generated(
            api_dir.join("ApiSupport.h"),
            support::api_support_header(config)?,
        ));
        files.push(PlannedFile::generated(
            api_dir.join("ApiTypes.h"),
            support::api_types_header(schema, config)?,
        ));
        files.push(PlannedFile::generated(
            managed_dir.join("NativeTypes.cs"),
            support::native_types_source(schema, config)?,
        ));
        files.push(PlannedFile::generated(
            managed_dir.join(format!("{}.cs", config.managed.object_class)),
            support::native_object_source(config)?,
        ));

        for ty in schema.classes() {
            if let (Some(base), None) = (&ty.base, schema.base_of(ty)) {
                warn!(type_name = %ty.name, base = %base, "Base is not an API class; ignoring it");
            }

            let surface = TypeSurface::new(schema, ty);
            let slots = surface.slot_table()?;
            let exports = surface.export_table()?;
            debug!(
                type_name = %ty.name,
                exports = exports.len(),
                slots = slots.as_ref().map_or(0, |s| s.len()),
                "Planning type"
            );

            let cabi = cabi::emit(&surface, &exports, config)?;
            let wrapper = managed::emit(&surface, &exports, slots.as_ref(), config)?;
            let fragment = native::emit(&surface, slots.as_ref(), config)?;

            check_symbol_parity(&ty.name, &cabi.symbols, &wrapper.symbols)?;
            if let Some(slots) = &slots {
                let orders: HashMap<&str, &Vec<String>> = fragment
                    .slot_orders
                    .iter()
                    .chain(wrapper.slot_orders.iter())
                    .map(|(artifact, order)| (*artifact, order))
                    .collect();
                for artifact in SLOT_ARTIFACTS {
                    let emitted = orders.get(artifact).map(|o| o.as_slice()).unwrap_or_default();
                    slots.verify(artifact, emitted)?;
                }
            }

            files.push(PlannedFile::generated(
                api_dir.join(format!("{}.Api.h", ty.name)),
                cabi.content,
            ));
            files.push(PlannedFile::generated(
                api_dir.join(format!("{}.inc", ty.name)),
                fragment.content,
            ));
            files.push(PlannedFile::generated(
                managed_dir.join(format!("{}.cs", ty.name)),
                wrapper.content,
            ));
            files.push(PlannedFile::scaffold(
                native_dir.join(format!("{}.h", ty.name)),
                scaffold::emit_header(&surface, config)?,
            ));
            files.push(PlannedFile::scaffold(
                native_dir.join(format!("{}.cpp", ty.name)),
                scaffold::emit_source(&surface, config)?,
            ));
        }

        files.push(PlannedFile::generated(
            native_dir.join("Api.cpp"),
            support::aggregate_source(schema, config)?,
        ));

        Ok(files)
    }

    /// Plan and write everything
    pub fn run(&self) -> GenerateResult<GenerationReport> {
        self.write(false)
    }

    /// Plan, then apply the plan unless `dry_run`
    pub fn write(&self, dry_run: bool) -> GenerateResult<GenerationReport> {
        let files = self.plan()?;
        let mut report = GenerationReport {
            files: Vec::with_capacity(files.len()),
            dry_run,
        };

        for file in files {
            let status = apply(&file, dry_run)?;
            debug!(path = %file.path.display(), %status, "Applied");
            report.files.push((file.path, status));
        }

        info!(
            written = report.count(FileStatus::Written),
            created = report.count(FileStatus::Created),
            unchanged = report.count(FileStatus::Unchanged),
            preserved = report.count(FileStatus::Preserved),
            dry_run,
            "Generation finished"
        );
        Ok(report)
    }
}

fn apply(file: &PlannedFile, dry_run: bool) -> GenerateResult<FileStatus> {
    let status = match file.kind {
        FileKind::Scaffold if file.path.exists() => return Ok(FileStatus::Preserved),
        FileKind::Scaffold => FileStatus::Created,
        FileKind::Generated => match fs::read(&file.path) {
            Ok(existing) if existing == file.content.as_bytes() => return Ok(FileStatus::Unchanged),
            Ok(_) => FileStatus::Written,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => FileStatus::Written,
            Err(e) => return Err(e.into()),
        },
    };

    if !dry_run {
        if let Some(parent) = file.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&file.path, &file.content)?;
    }
    Ok(status)
}

fn check_symbol_parity(type_name: &str, cabi: &[String], binding: &[String]) -> GenerateResult<()> {
    if cabi == binding {
        return Ok(());
    }
    Err(GenerateError::SymbolParityMismatch {
        type_name: type_name.to_string(),
        cabi: cabi.to_vec(),
        binding: binding.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ApiEvent, ApiProperty, ApiType, Primitive, TypeRef};
    use tempfile::TempDir;

    fn schema() -> ApiSchema {
        let mut widget = ApiType::class("Widget");
        widget.managed_server = true;
        widget.properties.push(ApiProperty::new("Text", TypeRef::Text).read_write());
        widget.events.push(ApiEvent {
            name: "Click".to_string(),
            data: None,
            cancellable: false,
        });
        let mut label = ApiType::class("Label");
        label.base = Some("Widget".to_string());
        label
            .properties
            .push(ApiProperty::new("Wrap", TypeRef::Primitive(Primitive::Bool)).read_write());
        ApiSchema::new(vec![widget, label]).unwrap()
    }

    fn generator(root: &Path) -> Generator {
        let mut config = GeneratorConfig::default();
        config.native.dir = root.join("native");
        config.managed.dir = root.join("managed");
        Generator::new(config, schema())
    }

    #[test]
    fn test_plan_layout() {
        let root = Path::new("out");
        let files = generator(root).plan().unwrap();
        let paths: Vec<_> = files.iter().map(|f| f.path.clone()).collect();

        for expected in [
            "out/native/Api/ApiSupport.h",
            "out/native/Api/ApiTypes.h",
            "out/native/Api/Widget.Api.h",
            "out/native/Api/Widget.inc",
            "out/native/Widget.h",
            "out/native/Widget.cpp",
            "out/native/Api/Label.Api.h",
            "out/native/Api.cpp",
            "out/managed/Widget.cs",
            "out/managed/Label.cs",
            "out/managed/NativeTypes.cs",
            "out/managed/NativeObject.cs",
        ] {
            assert!(paths.contains(&PathBuf::from(expected)), "missing {}", expected);
        }

        let scaffolds = files.iter().filter(|f| f.kind == FileKind::Scaffold).count();
        assert_eq!(scaffolds, 4);

        let aggregate = files.last().unwrap();
        assert!(aggregate
            .content
            .contains("#include \"Api/Widget.Api.h\"\n#include \"Api/Label.Api.h\"\n"));
    }

    #[test]
    fn test_regeneration_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let generator = generator(dir.path());

        let first = generator.run().unwrap();
        assert_eq!(first.count(FileStatus::Unchanged), 0);
        assert_eq!(first.count(FileStatus::Created), 4);

        let header = dir.path().join("native/Api/Widget.Api.h");
        let before = fs::read(&header).unwrap();

        let second = generator.run().unwrap();
        assert_eq!(second.count(FileStatus::Written), 0);
        assert_eq!(second.count(FileStatus::Created), 0);
        assert_eq!(second.count(FileStatus::Preserved), 4);
        assert_eq!(second.changed().count(), 0);
        assert_eq!(fs::read(&header).unwrap(), before);
    }

    #[test]
    fn test_scaffold_edits_survive() {
        let dir = TempDir::new().unwrap();
        let generator = generator(dir.path());
        generator.run().unwrap();

        let source = dir.path().join("native/Widget.cpp");
        fs::write(&source, "// mine\n").unwrap();
        let stale = dir.path().join("managed/Widget.cs");
        fs::write(&stale, "stale").unwrap();

        let report = generator.run().unwrap();
        assert_eq!(fs::read_to_string(&source).unwrap(), "// mine\n");
        assert_eq!(report.status_of(&source), Some(FileStatus::Preserved));
        assert_eq!(report.status_of(&stale), Some(FileStatus::Written));
        assert_ne!(fs::read_to_string(&stale).unwrap(), "stale");
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let dir = TempDir::new().unwrap();
        let report = generator(dir.path()).write(true).unwrap();
        assert!(report.dry_run);
        assert!(report.changed().count() > 0);
        assert!(!dir.path().join("native").exists());
        assert!(!dir.path().join("managed").exists());
    }

    #[test]
    fn test_failure_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let mut ty = ApiType::class("Gauge");
        ty.properties
            .push(ApiProperty::new("Samples", "int[]".parse().unwrap()).read_write());
        let mut config = GeneratorConfig::default();
        config.native.dir = dir.path().join("native");
        config.managed.dir = dir.path().join("managed");
        let generator = Generator::new(config, ApiSchema::new(vec![ty]).unwrap());

        assert!(matches!(
            generator.run(),
            Err(GenerateError::UnsupportedType { feature: "writable array properties", .. })
        ));
        assert!(!dir.path().join("native").exists());
    }

    #[test]
    fn test_colliding_symbols_write_nothing() {
        let dir = TempDir::new().unwrap();
        let mut ty = ApiType::class("Widget");
        ty.properties.push(ApiProperty::new("Text", TypeRef::Text));
        ty.methods
            .push(crate::model::ApiMethod::new("GetText").returning(TypeRef::Text));
        let mut config = GeneratorConfig::default();
        config.native.dir = dir.path().join("native");
        config.managed.dir = dir.path().join("managed");
        let generator = Generator::new(config, ApiSchema::new(vec![ty]).unwrap());

        match generator.run() {
            Err(GenerateError::DuplicateSymbol { symbol, .. }) => assert_eq!(symbol, "Widget_GetText"),
            other => panic!("expected duplicate symbol, got {:?}", other.map(|r| r.files.len())),
        }
        assert!(!dir.path().join("native").exists());
    }

    #[test]
    fn test_symbol_parity_mismatch() {
        let cabi = vec!["Widget_Create/0".to_string(), "Widget_Destroy/1".to_string()];
        let binding = vec!["Widget_Create/0".to_string()];
        assert!(check_symbol_parity("Widget", &cabi, &cabi).is_ok());
        assert!(matches!(
            check_symbol_parity("Widget", &cabi, &binding),
            Err(GenerateError::SymbolParityMismatch { .. })
        ));
    }
}
