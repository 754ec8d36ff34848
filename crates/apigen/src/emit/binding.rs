//! Native-call binding declarations
//!
//! Renders the `NativeApi` class nested in every managed wrapper: one
//! `[DllImport]` per export table entry, plus the event and trampoline
//! types those imports mention.

use super::{flat_parameter_list, symbol, trampoline};
use crate::code_writer::CodeWriter;
use crate::config::GeneratorConfig;
use crate::cw_writeln;
use crate::error::{GenerateError, GenerateResult};
use crate::model::TypeRef;
use crate::surface::{ArrayStep, ExportKind, ExportTable, TypeSurface};
use crate::trampoline::SlotTable;
use crate::types::{BindingTypes, Dialect, TypeNames, TypeUsage};

/// What the binding class declared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingReport {
    /// Imported symbols as `name/arity`, in declaration order
    pub symbols: Vec<String>,

    /// Slot order of the managed trampoline enumeration
    pub slot_order: Option<Vec<String>>,
}

/// Write the nested `NativeApi` class
pub fn emit(
    w: &mut CodeWriter<String>,
    surface: &TypeSurface<'_>,
    exports: &ExportTable,
    slots: Option<&SlotTable>,
    config: &GeneratorConfig,
) -> GenerateResult<BindingReport> {
    let ty = surface.ty();
    let resolver = BindingTypes::new(surface.schema());
    let mut names = TypeNames::new(&resolver);
    let convention = config.native.calling_convention.csharp();
    let mut report = BindingReport::default();

    let header = if surface.base().is_some() {
        "public new class NativeApi"
    } else {
        "public class NativeApi"
    };

    w.writeln("[SuppressUnmanagedCodeSecurity]")?;
    w.block(header, |w| {
        cw_writeln!(w, "private const string NativeModuleName = \"{}\";", config.managed.native_module)?;

        if surface.has_events() {
            w.blank_line()?;
            cw_writeln!(w, "[UnmanagedFunctionPointer({})]", convention)?;
            cw_writeln!(
                w,
                "public delegate IntPtr {0}EventCallbackType(IntPtr obj, {0}Event e, IntPtr parameter);",
                ty.name
            )?;
            w.blank_line()?;
            w.block(&format!("public enum {}Event", ty.name), |w| {
                for event in surface.events() {
                    cw_writeln!(w, "{},", event.name)?;
                }
                Ok::<(), std::fmt::Error>(())
            })?;
        }

        if let Some(slots) = slots {
            w.blank_line()?;
            report.slot_order = Some(trampoline::emit_managed_declarations(w, surface, slots, config)?);
        }

        for export in exports.iter() {
            let (ret, params, return_attribute) = match export.kind {
                ExportKind::Create => ("IntPtr".to_string(), Vec::new(), None),
                ExportKind::Destroy => ("void".to_string(), vec!["IntPtr obj".to_string()], None),
                ExportKind::Member(member) => {
                    let signature = member.signature(ty);
                    let mut params = Vec::new();
                    if !signature.is_static {
                        params.push("IntPtr obj".to_string());
                    }
                    params.extend(flat_parameter_list(&mut names, &signature.params)?);
                    (
                        names.name(signature.returns, TypeUsage::RETURN)?,
                        params,
                        resolver.return_attribute(signature.returns)?,
                    )
                }
                ExportKind::ArrayAccess(index, step) => {
                    let property = &ty.properties[index];
                    let mut params = Vec::new();
                    if !property.is_static {
                        params.push("IntPtr obj".to_string());
                    }
                    if step != ArrayStep::Open {
                        params.push("IntPtr array".to_string());
                    }
                    match (step, &property.ty) {
                        (ArrayStep::Open, _) => ("IntPtr".to_string(), params, None),
                        (ArrayStep::Count, _) => ("int".to_string(), params, None),
                        (ArrayStep::ItemAt, TypeRef::Array(element)) => {
                            params.push("int index".to_string());
                            (
                                names.name(element, TypeUsage::RETURN)?,
                                params,
                                resolver.return_attribute(element)?,
                            )
                        }
                        (ArrayStep::ItemAt, other) => {
                            return Err(GenerateError::unsupported(Dialect::Binding, "array accessors", other))
                        }
                        (ArrayStep::Close, _) => ("void".to_string(), params, None),
                    }
                }
                ExportKind::SetEventCallback => (
                    "void".to_string(),
                    vec![format!("{}EventCallbackType callback", ty.name)],
                    None,
                ),
                ExportKind::SetTrampolineLocatorCallback => (
                    "void".to_string(),
                    vec![format!("{}TrampolineLocatorCallback callback", ty.name)],
                    None,
                ),
                ExportKind::SetManagedHandle => (
                    "void".to_string(),
                    vec!["IntPtr obj".to_string(), "IntPtr handle".to_string()],
                    None,
                ),
            };

            w.blank_line()?;
            cw_writeln!(w, "[DllImport(NativeModuleName, CallingConvention = {})]", convention)?;
            if let Some(attribute) = return_attribute {
                w.writeln(attribute)?;
            }
            cw_writeln!(w, "public static extern {} {}({});", ret, export.name, params.join(", "))?;
            report.symbols.push(symbol(&export.name, params.len()));
        }
        Ok::<(), GenerateError>(())
    })?;

    Ok(report)
}
