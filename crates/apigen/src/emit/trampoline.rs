//! Both halves of the trampoline protocol
//!
//! Native half: `struct Managed` inside the class body, holding the slot
//! enumeration, the once-only locator and one typed wrapper per slot.
//! Managed half: the slot enumeration and delegates inside `NativeApi`,
//! plus the pinned dispatch cache and locator in the wrapper class.
//!
//! Every function here returns the slot names in the order it emitted
//! them, so the generator can hold each artifact against the slot table.

use super::managed::{unwrap_object, wrap_pointer};
use super::parameter_list;
use crate::code_writer::CodeWriter;
use crate::config::GeneratorConfig;
use crate::cw_writeln;
use crate::error::GenerateResult;
use crate::model::TypeRef;
use crate::surface::{MemberRef, TypeSurface};
use crate::trampoline::SlotTable;
use crate::types::{shape_of, BindingTypes, CAbiTypes, Dialect, Shape, TypeNames, TypeResolver, TypeUsage};

/// `struct Managed` for the native class body
pub fn emit_native(
    w: &mut CodeWriter<String>,
    surface: &TypeSurface<'_>,
    slots: &SlotTable,
) -> GenerateResult<Vec<String>> {
    let ty = surface.ty();
    let resolver = CAbiTypes::new(surface.schema());
    let mut names = TypeNames::new(&resolver);
    let mut emitted = Vec::with_capacity(slots.len());

    w.writeln("public:")?;
    let _indent = w.indent();
    w.block_with_suffix("struct Managed", ";", |w| {
        w.block_with_suffix("enum class Trampoline", ";", |w| {
            for slot in slots.slots() {
                cw_writeln!(w, "{},", slot.name)?;
                emitted.push(slot.name.clone());
            }
            Ok::<(), crate::error::GenerateError>(())
        })?;
        w.blank_line()?;
        w.writeln("typedef void* (NATIVE_CALLBACK_CALL* TTrampolineLocatorCallback)(Trampoline trampoline);")?;
        w.blank_line()?;
        w.block("static void SetTrampolineLocatorCallback(TTrampolineLocatorCallback value)", |w| {
            w.writeln("TTrampolineLocatorCallback expected = nullptr;")?;
            w.writeln("Locator().compare_exchange_strong(expected, value);")
        })?;

        for slot in slots.slots() {
            let signature = slot.signature(ty);
            let ret = names.name(signature.returns, TypeUsage::RETURN)?;
            let mut params = Vec::new();
            let mut args = Vec::new();
            if !signature.is_static {
                params.push("void* obj".to_string());
                args.push("obj");
            }
            params.extend(parameter_list(&mut names, &signature.params, TypeUsage::ARGUMENT)?);
            args.extend(signature.params.iter().map(|(name, _)| *name));

            let call = format!(
                "reinterpret_cast<T{0}>(Locate(Trampoline::{0}))({1})",
                slot.name,
                args.join(", ")
            );
            let statement = if signature.returns.is_void() {
                format!("{};", call)
            } else {
                format!("return {};", call)
            };

            w.blank_line()?;
            cw_writeln!(
                w,
                "typedef {} (NATIVE_CALLBACK_CALL* T{})({});",
                ret,
                slot.name,
                params.join(", ")
            )?;
            w.blank_line()?;
            w.block(&format!("static {} {}({})", ret, slot.name, params.join(", ")), |w| {
                w.writeln(&statement)
            })?;
        }

        w.blank_line()?;
        w.writeln("private:")?;
        w.block("static std::atomic<TTrampolineLocatorCallback>& Locator()", |w| {
            w.writeln("static std::atomic<TTrampolineLocatorCallback> locator{nullptr};")?;
            w.writeln("return locator;")
        })?;
        w.blank_line()?;
        w.block("static void* Locate(Trampoline trampoline)", |w| {
            w.writeln("TTrampolineLocatorCallback callback = Locator().load();")?;
            w.writeln("if (callback == nullptr)")?;
            {
                let _indent = w.indent();
                cw_writeln!(w, "throw TrampolineLocatorNotSetException(\"{}\");", ty.name)?;
            }
            w.writeln("void* entry = callback(trampoline);")?;
            w.writeln("if (entry == nullptr)")?;
            {
                let _indent = w.indent();
                cw_writeln!(
                    w,
                    "throw UnknownTrampolineException(\"{}\", static_cast<int>(trampoline));",
                    ty.name
                )?;
            }
            w.writeln("return entry;")
        })?;
        Ok::<(), crate::error::GenerateError>(())
    })?;

    Ok(emitted)
}

/// Slot enumeration, locator delegate and per-slot delegates for `NativeApi`
pub fn emit_managed_declarations(
    w: &mut CodeWriter<String>,
    surface: &TypeSurface<'_>,
    slots: &SlotTable,
    config: &GeneratorConfig,
) -> GenerateResult<Vec<String>> {
    let ty = surface.ty();
    let resolver = BindingTypes::new(surface.schema());
    let mut names = TypeNames::new(&resolver);
    let convention = config.native.calling_convention.csharp();
    let mut emitted = Vec::with_capacity(slots.len());

    w.block(&format!("public enum {}Trampoline", ty.name), |w| {
        for slot in slots.slots() {
            cw_writeln!(w, "{},", slot.name)?;
            emitted.push(slot.name.clone());
        }
        Ok::<(), crate::error::GenerateError>(())
    })?;
    w.blank_line()?;
    cw_writeln!(w, "[UnmanagedFunctionPointer({})]", convention)?;
    cw_writeln!(
        w,
        "public delegate IntPtr {0}TrampolineLocatorCallback({0}Trampoline trampoline);",
        ty.name
    )?;

    for slot in slots.slots() {
        let signature = slot.signature(ty);
        let mut params = Vec::new();
        if !signature.is_static {
            params.push("IntPtr obj".to_string());
        }
        params.extend(parameter_list(&mut names, &signature.params, TypeUsage::ARGUMENT)?);
        let ret = names.name(signature.returns, TypeUsage::RETURN)?;

        w.blank_line()?;
        cw_writeln!(w, "[UnmanagedFunctionPointer({})]", convention)?;
        if let Some(attribute) = resolver.return_attribute(signature.returns)? {
            w.writeln(attribute)?;
        }
        cw_writeln!(
            w,
            "public delegate {} {}{}Trampoline({});",
            ret,
            ty.name,
            slot.name,
            params.join(", ")
        )?;
    }

    Ok(emitted)
}

/// Dispatch cache, once-only registration and slot implementations for the
/// wrapper class. Returns the slot order of the pinning switch.
pub fn emit_managed_dispatch(
    w: &mut CodeWriter<String>,
    surface: &TypeSurface<'_>,
    slots: &SlotTable,
    config: &GeneratorConfig,
) -> GenerateResult<Vec<String>> {
    let ty = surface.ty();
    let schema = surface.schema();
    let binding = BindingTypes::new(schema);
    let object_class = &config.managed.object_class;
    let slot_enum = format!("NativeApi.{}Trampoline", ty.name);
    let mut emitted = Vec::with_capacity(slots.len());

    cw_writeln!(
        w,
        "static readonly ConcurrentDictionary<{}, Lazy<(GCHandle Pin, IntPtr Pointer)>> trampolines = new();",
        slot_enum
    )?;
    cw_writeln!(
        w,
        "static readonly NativeApi.{}TrampolineLocatorCallback trampolineLocator = LocateTrampoline;",
        ty.name
    )?;
    w.writeln("static int trampolineLocatorRegistered;")?;
    w.blank_line()?;

    w.block("static void SetTrampolineLocator()", |w| {
        w.writeln("if (Interlocked.Exchange(ref trampolineLocatorRegistered, 1) != 0)")?;
        {
            let _indent = w.indent();
            w.writeln("return;")?;
        }
        cw_writeln!(w, "NativeApi.{}_SetTrampolineLocatorCallback(trampolineLocator);", ty.name)
    })?;
    w.blank_line()?;

    w.block(&format!("static IntPtr LocateTrampoline({} trampoline)", slot_enum), |w| {
        cw_writeln!(w, "if (!Enum.IsDefined(typeof({}), trampoline))", slot_enum)?;
        {
            let _indent = w.indent();
            w.writeln("return IntPtr.Zero;")?;
        }
        w.writeln("return trampolines.GetOrAdd(")?;
        {
            let _indent = w.indent();
            w.writeln("trampoline,")?;
            w.writeln("slot => new Lazy<(GCHandle Pin, IntPtr Pointer)>(() => PinTrampoline(slot))).Value.Pointer;")?;
        }
        Ok::<(), std::fmt::Error>(())
    })?;
    w.blank_line()?;

    w.block(
        &format!("static (GCHandle Pin, IntPtr Pointer) PinTrampoline({} trampoline)", slot_enum),
        |w| {
            w.block_with_suffix("Delegate callable = trampoline switch", ";", |w| {
                for slot in slots.slots() {
                    cw_writeln!(
                        w,
                        "{}.{} => new NativeApi.{}{}Trampoline(Trampoline{}),",
                        slot_enum,
                        slot.name,
                        ty.name,
                        slot.name,
                        slot.name
                    )?;
                    emitted.push(slot.name.clone());
                }
                w.writeln("_ => throw new ArgumentOutOfRangeException(nameof(trampoline)),")
            })?;
            w.writeln("var pin = GCHandle.Alloc(callable);")?;
            w.writeln("return (pin, Marshal.GetFunctionPointerForDelegate(callable));")
        },
    )?;

    for slot in slots.slots() {
        let signature = slot.signature(ty);
        let mut params = Vec::new();
        if !signature.is_static {
            params.push("IntPtr obj".to_string());
        }
        let mut args = Vec::new();
        for (name, param) in &signature.params {
            params.push(format!("{} {}", plain(&binding, param)?, name));
            args.push(match shape_of(schema, param, Dialect::Managed)? {
                Shape::Class { ty: api, nullable } => wrap_pointer(object_class, api, name, nullable),
                _ => name.to_string(),
            });
        }
        let ret = plain(&binding, signature.returns)?;

        let target = if signature.is_static {
            ty.name.clone()
        } else {
            "target".to_string()
        };
        let invocation = match slot.member {
            MemberRef::Getter(index) => format!("{}.{}", target, ty.properties[index].name),
            MemberRef::Setter(index) => format!("{}.{} = {}", target, ty.properties[index].name, args.join(", ")),
            MemberRef::Method(index) => format!("{}.{}({})", target, ty.methods[index].name, args.join(", ")),
        };
        let statement = match shape_of(schema, signature.returns, Dialect::Managed)? {
            Shape::Void => format!("{};", invocation),
            Shape::Class { nullable, .. } => format!("return {};", unwrap_object(&invocation, nullable)),
            _ => format!("return {};", invocation),
        };

        w.blank_line()?;
        w.block(
            &format!("static {} Trampoline{}({})", ret, slot.name, params.join(", ")),
            |w| {
                if !signature.is_static {
                    cw_writeln!(w, "var target = ({})GCHandle.FromIntPtr(obj).Target!;", ty.name)?;
                }
                w.writeln(&statement)
            },
        )?;
    }

    Ok(emitted)
}

/// Binding spelling without marshalling attributes
fn plain(binding: &BindingTypes<'_>, ty: &TypeRef) -> GenerateResult<String> {
    Ok(binding.resolve(ty, TypeUsage::RETURN)?.literal)
}
