//! Once-per-run support artifacts
//!
//! `ApiSupport.h` (export macros, text marshalling, trampoline
//! exceptions), `ApiTypes.h` (class forward declarations, enums, structs),
//! the managed mirror of the value types in `NativeTypes.cs`, the managed
//! object base class and the `Api.cpp` aggregate.

use std::collections::HashSet;

use super::{write_header, writer};
use crate::code_writer::CodeWriter;
use crate::config::GeneratorConfig;
use crate::cw_writeln;
use crate::error::{GenerateError, GenerateResult};
use crate::model::{ApiSchema, ApiType};
use crate::types::{shape_of, CAbiTypes, Dialect, ManagedTypes, Shape, TypeNames, TypeUsage};

/// Native support header, `Api/ApiSupport.h`
pub fn api_support_header(config: &GeneratorConfig) -> GenerateResult<String> {
    let convention = config.native.calling_convention.msvc();
    let mut w = writer(config);
    write_header(&mut w, config)?;
    w.writeln("#pragma once")?;
    w.blank_line()?;
    for include in ["atomic", "cstdint", "cstdlib", "cstring", "new", "stdexcept", "string", "type_traits", "vector"] {
        cw_writeln!(w, "#include <{}>", include)?;
    }
    w.blank_line()?;

    w.writeln("#ifdef _WIN32")?;
    w.writeln("#include <objbase.h>")?;
    w.writeln("#define NATIVE_API extern \"C\" __declspec(dllexport)")?;
    cw_writeln!(w, "#define NATIVE_API_CALL {}", convention)?;
    cw_writeln!(w, "#define NATIVE_CALLBACK_CALL {}", convention)?;
    w.writeln("#else")?;
    w.writeln("#define NATIVE_API extern \"C\" __attribute__((visibility(\"default\")))")?;
    w.writeln("#define NATIVE_API_CALL")?;
    w.writeln("#define NATIVE_CALLBACK_CALL")?;
    w.writeln("#endif")?;
    w.blank_line()?;

    w.writeln("typedef uint8_t c_bool;")?;
    w.writeln("using string = std::u16string;")?;

    w.blank_line()?;
    w.block_with_suffix(
        "class TrampolineLocatorNotSetException : public std::logic_error",
        ";",
        |w| {
            w.writeln("public:")?;
            let _indent = w.indent();
            w.writeln("explicit TrampolineLocatorNotSetException(const char* typeName)")?;
            w.writeln("    : std::logic_error(std::string(\"Trampoline locator is not set for \") + typeName)")?;
            w.braces(|_| Ok::<(), std::fmt::Error>(()))
        },
    )?;

    w.blank_line()?;
    w.block_with_suffix("class UnknownTrampolineException : public std::logic_error", ";", |w| {
        w.writeln("public:")?;
        let _indent = w.indent();
        w.writeln("UnknownTrampolineException(const char* typeName, int trampoline)")?;
        w.writeln(
            "    : std::logic_error(std::string(\"Unknown trampoline \") + std::to_string(trampoline) + \" in \" + typeName)",
        )?;
        w.braces(|_| Ok::<(), std::fmt::Error>(()))
    })?;

    w.blank_line()?;
    w.block("inline char16_t* AllocInteropString(const string& value)", |w| {
        w.writeln("size_t size = (value.size() + 1) * sizeof(char16_t);")?;
        w.writeln("#ifdef _WIN32")?;
        w.writeln("auto buffer = static_cast<char16_t*>(CoTaskMemAlloc(size));")?;
        w.writeln("#else")?;
        w.writeln("auto buffer = static_cast<char16_t*>(malloc(size));")?;
        w.writeln("#endif")?;
        w.writeln("if (buffer == nullptr)")?;
        w.writeln("    throw std::bad_alloc();")?;
        w.writeln("memcpy(buffer, value.c_str(), size);")?;
        w.writeln("return buffer;")
    })?;

    w.blank_line()?;
    w.block("inline string FromInteropString(const char16_t* value)", |w| {
        w.writeln("return value == nullptr ? string() : string(value);")
    })?;

    w.blank_line()?;
    w.block("inline void FreeInteropString(char16_t* value)", |w| {
        w.writeln("#ifdef _WIN32")?;
        w.writeln("CoTaskMemFree(value);")?;
        w.writeln("#else")?;
        w.writeln("free(value);")?;
        w.writeln("#endif")
    })?;

    w.blank_line()?;
    let flags_macro = [
        "#define APIGEN_FLAGS_OPERATORS(E) \\",
        "    inline E operator|(E a, E b) { using U = std::underlying_type_t<E>; return static_cast<E>(static_cast<U>(a) | static_cast<U>(b)); } \\",
        "    inline E operator&(E a, E b) { using U = std::underlying_type_t<E>; return static_cast<E>(static_cast<U>(a) & static_cast<U>(b)); } \\",
        "    inline E operator^(E a, E b) { using U = std::underlying_type_t<E>; return static_cast<E>(static_cast<U>(a) ^ static_cast<U>(b)); } \\",
        "    inline E operator~(E a) { using U = std::underlying_type_t<E>; return static_cast<E>(~static_cast<U>(a)); } \\",
        "    inline E& operator|=(E& a, E b) { return a = a | b; } \\",
        "    inline E& operator&=(E& a, E b) { return a = a & b; }",
    ];
    for line in flags_macro {
        w.writeln_unindented(line)?;
    }

    Ok(w.into_inner())
}

/// Native value types, `Api/ApiTypes.h`
pub fn api_types_header(schema: &ApiSchema, config: &GeneratorConfig) -> GenerateResult<String> {
    let resolver = CAbiTypes::new(schema);
    let mut names = TypeNames::new(&resolver);
    let mut w = writer(config);
    write_header(&mut w, config)?;
    w.writeln("#pragma once")?;
    w.blank_line()?;
    w.writeln("#include \"ApiSupport.h\"")?;

    let classes: Vec<&ApiType> = schema.classes().collect();
    if !classes.is_empty() {
        w.blank_line()?;
        for class in classes {
            cw_writeln!(w, "class {};", class.name)?;
        }
    }

    for ty in schema.enums() {
        let values = ty.resolved_variants()?;
        let underlying = if is_wide_enum(&values) { "int64_t" } else { "int" };
        w.blank_line()?;
        w.block_with_suffix(&format!("enum class {} : {}", ty.name, underlying), ";", |w| {
            for (name, value) in &values {
                cw_writeln!(w, "{} = {},", name, value)?;
            }
            Ok::<(), std::fmt::Error>(())
        })?;
        if ty.flags {
            cw_writeln!(w, "APIGEN_FLAGS_OPERATORS({})", ty.name)?;
        }
    }

    for ty in struct_order(schema)? {
        let mut fields = Vec::with_capacity(ty.fields.len());
        for field in &ty.fields {
            fields.push((names.name(&field.ty, TypeUsage::STATIC)?, field.name.as_str()));
        }
        w.blank_line()?;
        w.block_with_suffix(&format!("struct {}", ty.name), ";", |w| {
            for (literal, name) in &fields {
                cw_writeln!(w, "{} {};", literal, name)?;
            }
            Ok::<(), std::fmt::Error>(())
        })?;
    }

    Ok(w.into_inner())
}

/// Managed value types, `NativeTypes.cs`
pub fn native_types_source(schema: &ApiSchema, config: &GeneratorConfig) -> GenerateResult<String> {
    let resolver = ManagedTypes::new(schema);
    let mut names = TypeNames::new(&resolver);
    let structs = struct_order(schema)?;

    let mut w = writer(config);
    write_header(&mut w, config)?;
    w.writeln("using System;")?;
    w.writeln("using System.Runtime.InteropServices;")?;
    w.blank_line()?;

    w.block(&format!("namespace {}", config.managed.namespace), |w| {
        let mut first = true;
        for ty in schema.enums() {
            if !std::mem::take(&mut first) {
                w.blank_line()?;
            }
            if ty.flags {
                w.writeln("[Flags]")?;
            }
            let values = ty.resolved_variants()?;
            let underlying = if is_wide_enum(&values) { "long" } else { "int" };
            w.block(&format!("public enum {} : {}", ty.name, underlying), |w| {
                for (name, value) in &values {
                    cw_writeln!(w, "{} = {},", name, value)?;
                }
                Ok::<(), std::fmt::Error>(())
            })?;
        }

        for ty in &structs {
            if !std::mem::take(&mut first) {
                w.blank_line()?;
            }
            w.writeln("[StructLayout(LayoutKind.Sequential)]")?;
            w.block(&format!("public struct {}", ty.name), |w| {
                for field in &ty.fields {
                    if shape_of(schema, &field.ty, Dialect::Managed)?.is_bool() {
                        w.writeln("[MarshalAs(UnmanagedType.I1)]")?;
                    }
                    cw_writeln!(w, "public {} {};", names.name(&field.ty, TypeUsage::STATIC)?, field.name)?;
                }
                Ok::<(), GenerateError>(())
            })?;
        }
        Ok::<(), GenerateError>(())
    })?;

    Ok(w.into_inner())
}

/// Managed base class every root wrapper derives from
pub fn native_object_source(config: &GeneratorConfig) -> GenerateResult<String> {
    let class = config.managed.object_class.as_str();
    let mut w = writer(config);
    write_header(&mut w, config)?;
    w.writeln("#nullable enable")?;
    w.blank_line()?;
    w.writeln("using System;")?;
    w.writeln("using System.Collections.Concurrent;")?;
    w.blank_line()?;

    w.block(&format!("namespace {}", config.managed.namespace), |w| {
        w.block(&format!("internal abstract class {} : IDisposable", class), |w| {
            cw_writeln!(
                w,
                "static readonly ConcurrentDictionary<IntPtr, WeakReference<{}>> instances = new();",
                class
            )?;
            w.blank_line()?;
            w.writeln("bool isDisposed;")?;
            w.blank_line()?;
            cw_writeln!(w, "protected {}()", class)?;
            w.braces(|_| Ok::<(), std::fmt::Error>(()))?;
            w.blank_line()?;
            w.block(&format!("protected {}(IntPtr nativePointer)", class), |w| {
                w.writeln("SetNativePointer(nativePointer);")
            })?;
            w.blank_line()?;
            w.writeln("/// <summary>Invoked for every native pointer a wrapper call hands back.</summary>")?;
            w.writeln("public static Action<IntPtr>? NativePointerReleased;")?;
            w.blank_line()?;
            w.writeln("public IntPtr NativePointer { get; private set; }")?;
            w.blank_line()?;
            w.writeln("public bool IsNativeObjectDestroyed => isDisposed || NativePointer == IntPtr.Zero;")?;
            w.blank_line()?;
            w.block("protected void SetNativePointer(IntPtr value)", |w| {
                w.writeln("if (NativePointer != IntPtr.Zero)")?;
                w.writeln("    instances.TryRemove(NativePointer, out _);")?;
                w.writeln("NativePointer = value;")?;
                w.writeln("if (value != IntPtr.Zero)")?;
                cw_writeln!(w, "    instances[value] = new WeakReference<{}>(this);", class)
            })?;
            w.blank_line()?;
            w.block(
                &format!(
                    "public static T? GetFromNativePointer<T>(IntPtr pointer, Func<IntPtr, T>? create) where T : {}",
                    class
                ),
                |w| {
                    w.writeln("if (pointer == IntPtr.Zero)")?;
                    w.writeln("    return null;")?;
                    w.writeln("if (instances.TryGetValue(pointer, out var weak) && weak.TryGetTarget(out var existing))")?;
                    w.writeln("    return (T)existing;")?;
                    w.writeln("return create?.Invoke(pointer);")
                },
            )?;
            w.blank_line()?;
            w.block("protected static void ReleaseNativeObjectPointer(IntPtr pointer)", |w| {
                w.writeln("if (pointer != IntPtr.Zero)")?;
                w.writeln("    NativePointerReleased?.Invoke(pointer);")
            })?;
            w.blank_line()?;
            w.writeln("protected virtual void DestroyNativeObject()")?;
            w.braces(|_| Ok::<(), std::fmt::Error>(()))?;
            w.blank_line()?;
            w.block("public void Dispose()", |w| {
                w.writeln("if (isDisposed)")?;
                w.writeln("    return;")?;
                w.writeln("DestroyNativeObject();")?;
                w.writeln("isDisposed = true;")?;
                w.writeln("GC.SuppressFinalize(this);")
            })
        })?;

        w.blank_line()?;
        w.block("internal class NativeEventArgs<T> : EventArgs where T : struct", |w| {
            w.block("public NativeEventArgs(T data)", |w| w.writeln("Data = data;"))?;
            w.blank_line()?;
            w.writeln("public T Data { get; }")?;
            w.blank_line()?;
            w.writeln("public IntPtr Result { get; set; }")
        })?;

        w.blank_line()?;
        w.writeln("internal delegate void NativeEventHandler<T>(object? sender, NativeEventArgs<T> e) where T : struct;")
    })?;

    Ok(w.into_inner())
}

/// `Api.cpp`, pulling every shim into one translation unit
pub fn aggregate_source(schema: &ApiSchema, config: &GeneratorConfig) -> GenerateResult<String> {
    let mut w = writer(config);
    write_header(&mut w, config)?;
    for ty in schema.classes() {
        cw_writeln!(w, "#include \"Api/{}.Api.h\"", ty.name)?;
    }
    Ok(w.into_inner())
}

fn is_wide_enum(values: &[(&str, i64)]) -> bool {
    values
        .iter()
        .any(|(_, value)| i32::try_from(*value).is_err())
}

/// Structs ordered so every struct follows the structs its fields embed.
///
/// Fields must be value types; strings and class references have no
/// by-value layout shared by both sides.
fn struct_order(schema: &ApiSchema) -> GenerateResult<Vec<&ApiType>> {
    let mut ordered = Vec::new();
    let mut done = HashSet::new();
    for ty in schema.structs() {
        visit_struct(schema, ty, &mut Vec::new(), &mut done, &mut ordered)?;
    }
    Ok(ordered)
}

fn visit_struct<'s>(
    schema: &'s ApiSchema,
    ty: &'s ApiType,
    path: &mut Vec<&'s str>,
    done: &mut HashSet<&'s str>,
    ordered: &mut Vec<&'s ApiType>,
) -> GenerateResult<()> {
    if done.contains(ty.name.as_str()) {
        return Ok(());
    }
    if path.contains(&ty.name.as_str()) {
        return Err(GenerateError::unsupported(Dialect::CAbi, "recursive structs", &ty.name));
    }
    path.push(&ty.name);
    for field in &ty.fields {
        match shape_of(schema, &field.ty, Dialect::CAbi)? {
            Shape::Struct(inner) => visit_struct(schema, inner, path, done, ordered)?,
            Shape::Primitive(_) | Shape::Enum(_) => {}
            _ => {
                return Err(GenerateError::unsupported(
                    Dialect::CAbi,
                    "non-value struct fields",
                    format!("{}.{}: {}", ty.name, field.name, field.ty),
                ))
            }
        }
    }
    path.pop();
    done.insert(&ty.name);
    ordered.push(ty);
    Ok(())
}
