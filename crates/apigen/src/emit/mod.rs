//! Per-dialect emitters
//!
//! Every emitter renders into an in-memory [`CodeWriter`] and returns the
//! text together with what it actually declared (symbols, slot orders).
//! The generator compares those reports before anything reaches disk.

pub mod binding;
pub mod cabi;
pub mod managed;
pub mod native;
pub mod scaffold;
pub mod support;
pub mod trampoline;

use crate::code_writer::CodeWriter;
use crate::config::GeneratorConfig;
use crate::error::GenerateResult;
use crate::model::TypeRef;
use crate::types::{TypeNames, TypeUsage};

/// One rendered file plus the facts the parity checks need.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Emitted {
    pub content: String,

    /// Exported or declared symbols as `name/arity`
    pub symbols: Vec<String>,

    /// Trampoline slot names in emitted order, keyed by artifact
    pub slot_orders: Vec<(&'static str, Vec<String>)>,
}

impl Emitted {
    pub fn text(content: String) -> Self {
        Self {
            content,
            ..Self::default()
        }
    }
}

pub(crate) fn writer(config: &GeneratorConfig) -> CodeWriter<String> {
    CodeWriter::with_indent_spaces(String::new(), config.output.indent)
}

/// Header comment at the top of every generated file
pub(crate) fn write_header(w: &mut CodeWriter<String>, config: &GeneratorConfig) -> GenerateResult<()> {
    for line in config.header_lines() {
        if line.is_empty() {
            w.writeln("//")?;
        } else {
            w.writeln(&format!("// {}", line))?;
        }
    }
    Ok(())
}

/// `type name, type name` in the given usage
pub(crate) fn parameter_list(
    names: &mut TypeNames<'_>,
    params: &[(&str, &TypeRef)],
    usage: TypeUsage,
) -> GenerateResult<Vec<String>> {
    params
        .iter()
        .map(|(name, ty)| Ok(format!("{} {}", names.name(ty, usage)?, name)))
        .collect()
}

/// Flat C parameters: an array becomes its element pointer followed by an
/// `int {name}Count`
pub(crate) fn flat_parameter_list(
    names: &mut TypeNames<'_>,
    params: &[(&str, &TypeRef)],
) -> GenerateResult<Vec<String>> {
    let mut flat = Vec::with_capacity(params.len());
    for (name, ty) in params {
        flat.push(format!("{} {}", names.name(ty, TypeUsage::ARGUMENT)?, name));
        if ty.is_array() {
            flat.push(format!("int {}Count", name));
        }
    }
    Ok(flat)
}

/// `name/arity`, the form both symbol reports use
pub(crate) fn symbol(name: &str, arity: usize) -> String {
    format!("{}/{}", name, arity)
}
