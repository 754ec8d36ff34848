//! Apigen: native-interface code generator
//!
//! Reads a declarative API schema and emits four mutually consistent
//! artifacts for every API class:
//! - a managed (C#) wrapper class with nested native-call bindings
//! - a flat C-ABI shim header
//! - a native (C++) class body fragment plus hand-editable scaffolds
//! - for managed-server types, both halves of the trampoline protocol
//!
//! The pipeline is `model` -> `types` -> `emit`/`trampoline` -> `generator`.

pub mod code_writer;
pub mod config;
pub mod emit;
pub mod error;
pub mod generator;
pub mod init;
pub mod logging;
pub mod model;
pub mod surface;
pub mod trampoline;
pub mod types;

pub use config::{CallingConvention, ConfigError, GeneratorConfig};
pub use error::{GenerateError, GenerateResult};
pub use generator::{FileKind, FileStatus, GenerationReport, Generator, PlannedFile};
pub use init::{init_project, InitError};
pub use model::{
    ApiEvent, ApiField, ApiMethod, ApiParameter, ApiProperty, ApiSchema, ApiType, EnumVariant,
    MemberVisibility, Primitive, SchemaError, TypeKind, TypeRef,
};
pub use surface::{ExportKind, ExportTable, ExportedSymbol, TypeSurface};
pub use trampoline::{SlotKind, SlotTable, TrampolineSlot};
pub use types::{Dialect, IncludeSet, Resolved, TypeNames, TypeResolver, TypeUsage};
