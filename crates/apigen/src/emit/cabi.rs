//! C-ABI shim (`Api/{Type}.Api.h`)
//!
//! One `extern "C"` function per export table entry. Each shim converts
//! its flat arguments into the native class's calling shape and converts
//! the result back. Array properties are read through a heap snapshot of
//! the native `std::vector` that the managed side opens and closes.

use super::{flat_parameter_list, symbol, write_header, writer, Emitted};
use crate::config::GeneratorConfig;
use crate::cw_writeln;
use crate::error::{GenerateError, GenerateResult};
use crate::model::{ApiProperty, ApiSchema, TypeRef};
use crate::surface::{ArrayStep, ExportKind, ExportTable, TypeSurface};
use crate::types::{shape_of, CAbiTypes, Dialect, NativeTypes, Shape, TypeNames, TypeResolver, TypeUsage};

/// Render the shim for one class type
pub fn emit(surface: &TypeSurface<'_>, exports: &ExportTable, config: &GeneratorConfig) -> GenerateResult<Emitted> {
    let schema = surface.schema();
    let ty = surface.ty();
    let resolver = CAbiTypes::new(schema);
    let native = NativeTypes::new(schema);
    let mut names = TypeNames::new(&resolver);
    let mut body = writer(config);
    let mut symbols = Vec::with_capacity(exports.len());

    for export in exports.iter() {
        let (ret, params, statement) = match export.kind {
            ExportKind::Create => (
                format!("{}*", ty.name),
                Vec::new(),
                format!("return new {}();", ty.name),
            ),
            ExportKind::Destroy => (
                "void".to_string(),
                vec![format!("{}* obj", ty.name)],
                "delete obj;".to_string(),
            ),
            ExportKind::Member(member) => {
                let signature = member.signature(ty);
                let mut params = Vec::new();
                if !signature.is_static {
                    params.push(format!("{}* obj", ty.name));
                }
                params.extend(flat_parameter_list(&mut names, &signature.params)?);
                let ret = names.name(signature.returns, TypeUsage::RETURN)?;

                let args = signature
                    .params
                    .iter()
                    .map(|(name, param)| native_argument(schema, &native, name, param))
                    .collect::<GenerateResult<Vec<_>>>()?;
                let receiver = if signature.is_static {
                    format!("{}::", ty.name)
                } else {
                    "obj->".to_string()
                };
                let call = format!("{}{}({})", receiver, signature.name, args.join(", "));
                (ret, params, native_result(schema, signature.returns, call)?)
            }
            ExportKind::ArrayAccess(index, step) => {
                array_access(schema, &native, &mut names, &ty.name, &ty.properties[index], step)?
            }
            ExportKind::SetEventCallback => (
                "void".to_string(),
                vec![format!("{0}::{0}EventCallbackType callback", ty.name)],
                format!("{}::SetEventCallback(callback);", ty.name),
            ),
            ExportKind::SetTrampolineLocatorCallback => (
                "void".to_string(),
                vec![format!("{}::Managed::TTrampolineLocatorCallback callback", ty.name)],
                format!("{}::Managed::SetTrampolineLocatorCallback(callback);", ty.name),
            ),
            ExportKind::SetManagedHandle => (
                "void".to_string(),
                vec![format!("{}* obj", ty.name), "void* handle".to_string()],
                "obj->SetManagedHandle(handle);".to_string(),
            ),
        };

        body.blank_line()?;
        cw_writeln!(body, "NATIVE_API {} NATIVE_API_CALL {}({})", ret, export.name, params.join(", "))?;
        body.braces(|w| w.writeln(&statement))?;
        symbols.push(symbol(&export.name, params.len()));
    }

    let own_header = format!("{}.h", ty.name);
    let mut includes = names.into_includes();
    includes.remove(&own_header);

    let mut w = writer(config);
    write_header(&mut w, config)?;
    w.writeln("#pragma once")?;
    w.blank_line()?;
    cw_writeln!(w, "#include \"../{}\"", own_header)?;
    w.writeln("#include \"ApiSupport.h\"")?;
    for include in includes.iter() {
        cw_writeln!(w, "#include \"../{}\"", include)?;
    }
    w.write(&body.into_inner())?;

    Ok(Emitted {
        content: w.into_inner(),
        symbols,
        slot_orders: Vec::new(),
    })
}

/// Expression handing a flat argument to the native member
fn native_argument(schema: &ApiSchema, native: &NativeTypes<'_>, name: &str, ty: &TypeRef) -> GenerateResult<String> {
    Ok(match shape_of(schema, ty, Dialect::CAbi)? {
        Shape::Text { .. } => format!("FromInteropString({})", name),
        Shape::Class { nullable: false, .. } => format!("*{}", name),
        Shape::Array(_) => {
            let vector = native.resolve(ty, TypeUsage::RETURN)?.literal;
            format!("{0}({1}, {1} + {1}Count)", vector, name)
        }
        _ => name.to_string(),
    })
}

/// Return type, parameters and body of one array accessor shim.
///
/// `Open` copies the property into a heap `std::vector`; the other steps
/// read or free that snapshot through the opaque `array` pointer.
fn array_access(
    schema: &ApiSchema,
    native: &NativeTypes<'_>,
    names: &mut TypeNames<'_>,
    type_name: &str,
    property: &ApiProperty,
    step: ArrayStep,
) -> GenerateResult<(String, Vec<String>, String)> {
    let TypeRef::Array(element) = &property.ty else {
        return Err(GenerateError::unsupported(Dialect::CAbi, "array accessors", &property.ty));
    };
    let vector = native.resolve(&property.ty, TypeUsage::RETURN)?.literal;
    let snapshot = format!("static_cast<{}*>(array)", vector);

    let mut params = Vec::new();
    if !property.is_static {
        params.push(format!("{}* obj", type_name));
    }
    if step != ArrayStep::Open {
        params.push("void* array".to_string());
    }

    Ok(match step {
        ArrayStep::Open => {
            let receiver = if property.is_static {
                format!("{}::", type_name)
            } else {
                "obj->".to_string()
            };
            let statement = format!("return new {}({}Get{}());", vector, receiver, property.name);
            ("void*".to_string(), params, statement)
        }
        ArrayStep::Count => {
            let statement = format!("return static_cast<int>({}->size());", snapshot);
            ("int".to_string(), params, statement)
        }
        ArrayStep::ItemAt => {
            params.push("int index".to_string());
            let ret = names.name(element, TypeUsage::RETURN)?;
            let item = format!("(*{})[index]", snapshot);
            let statement = match shape_of(schema, element, Dialect::CAbi)? {
                Shape::Text { .. } => format!("return AllocInteropString({});", item),
                _ => format!("return {};", item),
            };
            (ret, params, statement)
        }
        ArrayStep::Close => ("void".to_string(), params, format!("delete {};", snapshot)),
    })
}

/// Statement returning the native result in its flat form
fn native_result(schema: &ApiSchema, ty: &TypeRef, call: String) -> GenerateResult<String> {
    Ok(match shape_of(schema, ty, Dialect::CAbi)? {
        Shape::Void => format!("{};", call),
        Shape::Text { .. } => format!("return AllocInteropString({});", call),
        Shape::Class { nullable: false, .. } => format!("return &{};", call),
        _ => format!("return {};", call),
    })
}
