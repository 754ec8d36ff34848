//! Hand-editable scaffolds (`{Type}.h`, `{Type}.cpp`)
//!
//! Written once when absent and never touched again, so they carry no
//! generated-file header.

use super::native::native_members;
use super::writer;
use crate::config::GeneratorConfig;
use crate::cw_writeln;
use crate::error::GenerateResult;
use crate::surface::TypeSurface;

/// Class header wrapping the generated fragment
pub fn emit_header(surface: &TypeSurface<'_>, config: &GeneratorConfig) -> GenerateResult<String> {
    let ty = surface.ty();
    let mut w = writer(config);

    w.writeln("#pragma once")?;
    w.blank_line()?;
    w.writeln("#include \"Api/ApiTypes.h\"")?;
    let class_header = match surface.base() {
        Some(base) => {
            cw_writeln!(w, "#include \"{}.h\"", base.name)?;
            format!("class {} : public {}", ty.name, base.name)
        }
        None => format!("class {}", ty.name),
    };
    w.blank_line()?;
    w.writeln(&class_header)?;
    w.writeln("{")?;
    cw_writeln!(w, "#include \"Api/{}.inc\"", ty.name)?;
    w.writeln("};")?;

    Ok(w.into_inner())
}

/// Definitions stub for every declared member.
///
/// Instance members of a managed server forward to their trampoline,
/// passing the wrapper's handle as `obj`.
pub fn emit_source(surface: &TypeSurface<'_>, config: &GeneratorConfig) -> GenerateResult<String> {
    let ty = surface.ty();
    let mut w = writer(config);

    cw_writeln!(w, "#include \"{}.h\"", ty.name)?;
    w.blank_line()?;
    w.writeln("#include <stdexcept>")?;
    w.blank_line()?;
    w.block(&format!("{0}::{0}()", ty.name), |_| Ok::<(), std::fmt::Error>(()))?;
    w.blank_line()?;
    w.block(&format!("{0}::~{0}()", ty.name), |_| Ok::<(), std::fmt::Error>(()))?;

    let slots = surface.slot_table()?;
    for member in native_members(surface)? {
        let forward = slots
            .as_ref()
            .and_then(|slots| slots.slots().iter().find(|slot| slot.member == member.member && !slot.is_static))
            .map(|slot| {
                let signature = member.member.signature(ty);
                let mut args = vec!["GetManagedHandle()"];
                args.extend(signature.params.iter().map(|(name, _)| *name));
                let call = format!("{}({})", slot.name, args.join(", "));
                if member.returns_void {
                    format!("{};", call)
                } else {
                    format!("return {};", call)
                }
            });

        w.blank_line()?;
        w.block(
            &format!(
                "{} {}::{}({})",
                member.returns,
                ty.name,
                member.name,
                member.params.join(", ")
            ),
            |w| {
                if let Some(statement) = &forward {
                    w.writeln(statement)
                } else if member.returns_void {
                    Ok(())
                } else {
                    cw_writeln!(
                        w,
                        "throw std::logic_error(\"{}::{} is not implemented\");",
                        ty.name,
                        member.name
                    )
                }
            },
        )?;
    }

    Ok(w.into_inner())
}
