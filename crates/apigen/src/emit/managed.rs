//! Managed wrapper class (`{Type}.cs`)
//!
//! Managed-server instances pin themselves with a `GCHandle` while their
//! native object is alive and hand it to native code, which passes it back
//! as `obj` on every trampoline call.

use std::collections::HashMap;

use super::{binding, trampoline, write_header, writer, Emitted};
use crate::code_writer::CodeWriter;
use crate::config::GeneratorConfig;
use crate::cw_writeln;
use crate::error::{GenerateError, GenerateResult};
use crate::model::{ApiEvent, ApiSchema, ApiType, TypeRef};
use crate::surface::{ArrayStep, ExportKind, ExportTable, ExportedSymbol, MemberRef, MemberSignature, TypeSurface};
use crate::trampoline::SlotTable;
use crate::types::{shape_of, Dialect, ManagedTypes, Shape, TypeNames, TypeUsage};

/// Expression turning a native handle into a wrapper object
pub(crate) fn wrap_pointer(object_class: &str, api: &ApiType, expr: &str, nullable: bool) -> String {
    let factory = if api.is_abstract {
        "null".to_string()
    } else {
        format!("p => new {}(p)", api.name)
    };
    format!(
        "{}.GetFromNativePointer<{}>({}, {}){}",
        object_class,
        api.name,
        expr,
        factory,
        if nullable { "" } else { "!" }
    )
}

/// Expression turning a wrapper object into its native handle
pub(crate) fn unwrap_object(expr: &str, nullable: bool) -> String {
    if nullable {
        format!("{}?.NativePointer ?? IntPtr.Zero", expr)
    } else {
        format!("{}.NativePointer", expr)
    }
}

/// Render the wrapper for one class type.
///
/// Reports the imported symbols and the two managed trampoline orders
/// (enumeration and pinning switch).
pub fn emit(
    surface: &TypeSurface<'_>,
    exports: &ExportTable,
    slots: Option<&SlotTable>,
    config: &GeneratorConfig,
) -> GenerateResult<Emitted> {
    let ty = surface.ty();
    let resolver = ManagedTypes::new(surface.schema());
    let mut wrapper = WrapperWriter {
        surface,
        schema: surface.schema(),
        config,
        names: TypeNames::new(&resolver),
        members: exports
            .iter()
            .filter_map(|export| match export.kind {
                ExportKind::Member(member) => Some((member, export)),
                _ => None,
            })
            .collect(),
        arrays: exports
            .iter()
            .filter_map(|export| match export.kind {
                ExportKind::ArrayAccess(index, step) => Some(((index, step), export)),
                _ => None,
            })
            .collect(),
    };

    let mut w = writer(config);
    write_header(&mut w, config)?;
    w.writeln("#nullable enable")?;
    w.writeln("#pragma warning disable")?;
    w.blank_line()?;
    w.writeln("using System;")?;
    if slots.is_some() {
        w.writeln("using System.Collections.Concurrent;")?;
    }
    w.writeln("using System.ComponentModel;")?;
    w.writeln("using System.Runtime.InteropServices;")?;
    w.writeln("using System.Security;")?;
    if slots.is_some() {
        w.writeln("using System.Threading;")?;
    }
    w.blank_line()?;

    let mut emitted = Emitted::default();
    let base = surface
        .base()
        .map(|b| b.name.as_str())
        .unwrap_or(config.managed.object_class.as_str());
    let abstract_keyword = if surface.is_abstract() { "abstract " } else { "" };

    w.block(&format!("namespace {}", config.managed.namespace), |w| {
        w.block(
            &format!("internal {}partial class {} : {}", abstract_keyword, ty.name, base),
            |w| {
                wrapper.constructors(w, exports)?;

                for index in 0..ty.properties.len() {
                    wrapper.property(w, index)?;
                }
                for index in 0..ty.methods.len() {
                    wrapper.method(w, index)?;
                }

                if let Some(handle) = exports.find(ExportKind::SetManagedHandle) {
                    w.blank_line()?;
                    managed_handle(w, &handle.name)?;
                }

                let release_handle = surface.has_managed_handle();
                if let Some(destroy) = exports.find(ExportKind::Destroy) {
                    w.blank_line()?;
                    w.block("protected override void DestroyNativeObject()", |w| {
                        if release_handle {
                            w.writeln("ReleaseManagedHandle();")?;
                        }
                        w.writeln("if (NativePointer == IntPtr.Zero)")?;
                        {
                            let _indent = w.indent();
                            w.writeln("return;")?;
                        }
                        cw_writeln!(w, "NativeApi.{}(NativePointer);", destroy.name)?;
                        w.writeln("SetNativePointer(IntPtr.Zero);")
                    })?;
                } else if surface.owns_managed_handle() {
                    w.blank_line()?;
                    w.block("protected override void DestroyNativeObject()", |w| {
                        w.writeln("ReleaseManagedHandle();")?;
                        w.writeln("base.DestroyNativeObject();")
                    })?;
                }

                if surface.has_events() {
                    wrapper.events(w)?;
                }

                if let Some(slots) = slots {
                    w.blank_line()?;
                    let order = trampoline::emit_managed_dispatch(w, surface, slots, config)?;
                    emitted.slot_orders.push(("managed dispatch switch", order));
                }

                w.blank_line()?;
                let report = binding::emit(w, surface, exports, slots, config)?;
                emitted.symbols = report.symbols;
                if let Some(order) = report.slot_order {
                    emitted.slot_orders.insert(0, ("managed enum", order));
                }
                Ok::<(), GenerateError>(())
            },
        )
    })?;

    emitted.content = w.into_inner();
    Ok(emitted)
}

/// Handle storage of the first managed server in a hierarchy.
///
/// The handle is strong: the wrapper stays reachable for as long as native
/// code may call back into it, and is released when the native object is
/// destroyed.
fn managed_handle(w: &mut CodeWriter<String>, export: &str) -> GenerateResult<()> {
    w.writeln("GCHandle managedHandle;")?;
    w.blank_line()?;
    w.block("protected void AttachManagedHandle()", |w| {
        w.writeln("if (NativePointer == IntPtr.Zero || managedHandle.IsAllocated)")?;
        {
            let _indent = w.indent();
            w.writeln("return;")?;
        }
        w.writeln("managedHandle = GCHandle.Alloc(this);")?;
        cw_writeln!(w, "NativeApi.{}(NativePointer, GCHandle.ToIntPtr(managedHandle));", export)
    })?;
    w.blank_line()?;
    w.block("protected void ReleaseManagedHandle()", |w| {
        w.writeln("if (!managedHandle.IsAllocated)")?;
        {
            let _indent = w.indent();
            w.writeln("return;")?;
        }
        w.writeln("if (NativePointer != IntPtr.Zero)")?;
        {
            let _indent = w.indent();
            cw_writeln!(w, "NativeApi.{}(NativePointer, IntPtr.Zero);", export)?;
        }
        w.writeln("managedHandle.Free();")
    })?;
    Ok(())
}

struct WrapperWriter<'a, 's> {
    surface: &'a TypeSurface<'s>,
    schema: &'s ApiSchema,
    config: &'a GeneratorConfig,
    names: TypeNames<'a>,
    members: HashMap<MemberRef, &'a ExportedSymbol>,
    arrays: HashMap<(usize, ArrayStep), &'a ExportedSymbol>,
}

impl<'a, 's> WrapperWriter<'a, 's> {
    fn ty(&self) -> &'s ApiType {
        self.surface.ty()
    }

    fn constructors(&mut self, w: &mut CodeWriter<String>, exports: &ExportTable) -> GenerateResult<()> {
        let ty = self.surface.ty();
        let has_base = self.surface.base().is_some();

        let mut registrations = Vec::new();
        if self.surface.has_events() {
            registrations.push("SetEventCallback();");
        }
        if self.surface.is_managed_server() {
            registrations.push("SetTrampolineLocator();");
        }
        if !registrations.is_empty() {
            w.block(&format!("static {}()", ty.name), |w| {
                for line in &registrations {
                    w.writeln(line)?;
                }
                Ok::<(), std::fmt::Error>(())
            })?;
            w.blank_line()?;
        }

        let chain = if has_base { " : base(IntPtr.Zero)" } else { "" };
        let attach = self.surface.has_managed_handle();
        match exports.find(ExportKind::Create) {
            Some(create) => {
                w.block(&format!("public {}(){}", ty.name, chain), |w| {
                    cw_writeln!(w, "SetNativePointer(NativeApi.{}());", create.name)?;
                    if attach {
                        w.writeln("AttachManagedHandle();")?;
                    }
                    Ok::<(), std::fmt::Error>(())
                })?;
            }
            None => {
                w.block(&format!("protected {}(){}", ty.name, chain), |_| Ok::<(), std::fmt::Error>(()))?;
            }
        }
        w.blank_line()?;
        w.block(
            &format!("public {}(IntPtr nativePointer) : base(nativePointer)", ty.name),
            |w| {
                if attach {
                    w.writeln("AttachManagedHandle();")?;
                }
                Ok::<(), std::fmt::Error>(())
            },
        )?;
        Ok(())
    }

    fn modifiers(&self, is_static: bool) -> &'static str {
        if is_static {
            "public static"
        } else if self.surface.is_managed_server() {
            "public virtual"
        } else {
            "public"
        }
    }

    fn property(&mut self, w: &mut CodeWriter<String>, index: usize) -> GenerateResult<()> {
        let property = &self.ty().properties[index];
        let getter = self.members.get(&MemberRef::Getter(index)).copied();
        let setter = self.members.get(&MemberRef::Setter(index)).copied();
        let property_type = self.names.name(&property.ty, TypeUsage::RETURN)?;
        let header = format!("{} {} {}", self.modifiers(property.is_static), property_type, property.name);

        let getter_body = match getter {
            Some(export) => Some(self.call_body(MemberRef::Getter(index), export)?),
            None if property.get && property.ty.is_array() => Some(self.array_getter_body(index)?),
            None => None,
        };
        let setter_body = match setter {
            Some(export) => Some(self.call_body(MemberRef::Setter(index), export)?),
            None => None,
        };

        w.blank_line()?;
        w.block(&header, |w| {
            if let Some(body) = &getter_body {
                w.block("get", |w| write_lines(w, body))?;
            }
            if let Some(body) = &setter_body {
                w.block("set", |w| write_lines(w, body))?;
            }
            Ok::<(), std::fmt::Error>(())
        })?;
        Ok(())
    }

    fn method(&mut self, w: &mut CodeWriter<String>, index: usize) -> GenerateResult<()> {
        let member = MemberRef::Method(index);
        let Some(export) = self.members.get(&member).copied() else {
            return Ok(());
        };
        let method = &self.ty().methods[index];
        let returns = self.names.name(&method.returns, TypeUsage::RETURN)?;
        let mut params = Vec::with_capacity(method.parameters.len());
        for param in &method.parameters {
            params.push(format!("{} {}", self.names.name(&param.ty, TypeUsage::ARGUMENT)?, param.name));
        }
        let header = format!(
            "{} {} {}({})",
            self.modifiers(method.is_static),
            returns,
            method.name,
            params.join(", ")
        );
        let body = self.call_body(member, export)?;

        w.blank_line()?;
        w.block(&header, |w| write_lines(w, &body))?;
        Ok(())
    }

    /// Body lines forwarding one accessor or method to its import
    fn call_body(&self, member: MemberRef, export: &ExportedSymbol) -> GenerateResult<Vec<String>> {
        let signature: MemberSignature<'_> = member.signature(self.surface.ty());
        let mut lines = Vec::new();

        let mut args = Vec::with_capacity(signature.params.len() + 1);
        if !signature.is_static {
            args.push("NativePointer".to_string());
            lines.push("if (IsNativeObjectDestroyed)".to_string());
            if signature.returns.is_void() {
                lines.push(format!("{}return;", self.pad(1)));
            } else {
                lines.push(format!("{}return default!;", self.pad(1)));
            }
        }
        for (name, ty) in &signature.params {
            args.push(self.argument(name, ty)?);
            if ty.is_array() {
                args.push(format!("{}.Length", name));
            }
        }

        let call = format!("NativeApi.{}({})", export.name, args.join(", "));
        match shape_of(self.schema, signature.returns, Dialect::Managed)? {
            Shape::Void => lines.push(format!("{};", call)),
            Shape::Class { ty: api, nullable } => {
                lines.push(format!("var _handle = {};", call));
                lines.push(format!(
                    "var _result = {};",
                    wrap_pointer(&self.config.managed.object_class, api, "_handle", nullable)
                ));
                lines.push("ReleaseNativeObjectPointer(_handle);".to_string());
                lines.push("return _result;".to_string());
            }
            _ => lines.push(format!("return {};", call)),
        }
        Ok(lines)
    }

    /// Getter reading an array property through its accessor exports
    fn array_getter_body(&mut self, index: usize) -> GenerateResult<Vec<String>> {
        let property = &self.ty().properties[index];
        let TypeRef::Array(element) = &property.ty else {
            return Err(GenerateError::unsupported(Dialect::Managed, "array accessors", &property.ty));
        };
        let element_type = self.names.name(element, TypeUsage::RETURN)?;
        let (open, count, item_at, close) = (
            self.array_export(index, ArrayStep::Open)?,
            self.array_export(index, ArrayStep::Count)?,
            self.array_export(index, ArrayStep::ItemAt)?,
            self.array_export(index, ArrayStep::Close)?,
        );
        let (receiver, leading) = if property.is_static {
            ("", "")
        } else {
            ("NativePointer", "NativePointer, ")
        };
        let (one, two) = (self.pad(1), self.pad(2));

        let mut lines = Vec::new();
        if !property.is_static {
            lines.push("if (IsNativeObjectDestroyed)".to_string());
            lines.push(format!("{}return default!;", one));
        }
        lines.push(format!("var array = NativeApi.{}({});", open, receiver));
        lines.push("try".to_string());
        lines.push("{".to_string());
        lines.push(format!("{}var count = NativeApi.{}({}array);", one, count, leading));
        lines.push(format!(
            "{}var result = new System.Collections.Generic.List<{}>(count);",
            one, element_type
        ));
        lines.push(format!("{}for (int i = 0; i < count; i++)", one));
        lines.push(format!("{}{{", one));
        lines.push(format!("{}var n = NativeApi.{}({}array, i);", two, item_at, leading));
        match shape_of(self.schema, element, Dialect::Managed)? {
            Shape::Class { ty: api, .. } => {
                lines.push(format!(
                    "{}var item = {};",
                    two,
                    wrap_pointer(&self.config.managed.object_class, api, "n", false)
                ));
                lines.push(format!("{}ReleaseNativeObjectPointer(n);", two));
                lines.push(format!("{}result.Add(item);", two));
            }
            _ => lines.push(format!("{}result.Add(n);", two)),
        }
        lines.push(format!("{}}}", one));
        lines.push(format!("{}return result.ToArray();", one));
        lines.push("}".to_string());
        lines.push("finally".to_string());
        lines.push("{".to_string());
        lines.push(format!("{}NativeApi.{}({}array);", one, close, leading));
        lines.push("}".to_string());
        Ok(lines)
    }

    fn array_export(&self, index: usize, step: ArrayStep) -> GenerateResult<&'a str> {
        match self.arrays.get(&(index, step)).copied() {
            Some(export) => Ok(export.name.as_str()),
            None => Err(GenerateError::unsupported(
                Dialect::Managed,
                "array accessors",
                &self.ty().properties[index].ty,
            )),
        }
    }

    fn pad(&self, depth: usize) -> String {
        " ".repeat(self.config.output.indent * depth)
    }

    fn argument(&self, name: &str, ty: &TypeRef) -> GenerateResult<String> {
        Ok(match shape_of(self.schema, ty, Dialect::Managed)? {
            Shape::Class { nullable, .. } => unwrap_object(name, nullable),
            Shape::Array(element) => match *element {
                Shape::Class { ty: api, .. } => format!(
                    "Array.ConvertAll<{}, IntPtr>({}, x => x.NativePointer)",
                    api.name, name
                ),
                _ => name.to_string(),
            },
            _ => name.to_string(),
        })
    }

    fn events(&self, w: &mut CodeWriter<String>) -> GenerateResult<()> {
        let ty = self.surface.ty();
        let object_class = &self.config.managed.object_class;

        let mut cases = Vec::new();
        let mut declarations = Vec::new();
        for event in self.surface.events() {
            let (lines, declaration) = self.event_dispatch(event)?;
            cases.push((event.name.as_str(), lines));
            declarations.push(declaration);
        }

        w.blank_line()?;
        w.writeln("static GCHandle eventCallbackGCHandle;")?;
        w.blank_line()?;
        w.block("static void SetEventCallback()", |w| {
            w.block("if (!eventCallbackGCHandle.IsAllocated)", |w| {
                cw_writeln!(
                    w,
                    "var sink = new NativeApi.{}EventCallbackType((obj, e, parameter) =>",
                    ty.name
                )?;
                w.braces(|w| {
                    let factory = if ty.is_abstract {
                        "null".to_string()
                    } else {
                        format!("p => new {}(p)", ty.name)
                    };
                    cw_writeln!(
                        w,
                        "var w = {}.GetFromNativePointer<{}>(obj, {});",
                        object_class,
                        ty.name,
                        factory
                    )?;
                    w.writeln("if (w == null) return IntPtr.Zero;")?;
                    w.writeln("return w.OnEvent(e, parameter);")
                })?;
                w.writeln(");")?;
                w.writeln("eventCallbackGCHandle = GCHandle.Alloc(sink);")?;
                cw_writeln!(w, "NativeApi.{}_SetEventCallback(sink);", ty.name)
            })
        })?;

        w.blank_line()?;
        w.block(&format!("IntPtr OnEvent(NativeApi.{}Event e, IntPtr parameter)", ty.name), |w| {
            w.block("switch (e)", |w| {
                for (name, lines) in &cases {
                    cw_writeln!(w, "case NativeApi.{}Event.{}:", ty.name, name)?;
                    w.braces(|w| write_lines(w, lines))?;
                }
                cw_writeln!(
                    w,
                    "default: throw new Exception(\"Unexpected {}Event value: \" + e);",
                    ty.name
                )
            })
        })?;

        w.blank_line()?;
        for declaration in &declarations {
            w.writeln(declaration)?;
        }
        Ok(())
    }

    /// Dispatch lines for one `OnEvent` case and the member declaring the event
    fn event_dispatch(&self, event: &ApiEvent) -> GenerateResult<(Vec<String>, String)> {
        if let Some(data) = &event.data {
            let payload = match shape_of(self.schema, data, Dialect::Managed)? {
                Shape::Struct(api) => api.name.as_str(),
                _ => return Err(GenerateError::unsupported(Dialect::Managed, "non-struct event payloads", data)),
            };
            let lines = vec![
                format!(
                    "var ea = new NativeEventArgs<{0}>(Marshal.PtrToStructure<{0}>(parameter));",
                    payload
                ),
                format!("{}?.Invoke(this, ea); return ea.Result;", event.name),
            ];
            let declaration = format!("public event NativeEventHandler<{}>? {};", payload, event.name);
            return Ok((lines, declaration));
        }

        if event.cancellable {
            let lines = vec![
                "var cea = new CancelEventArgs();".to_string(),
                format!("{}?.Invoke(this, cea);", event.name),
                "return cea.Cancel ? new IntPtr(1) : IntPtr.Zero;".to_string(),
            ];
            let declaration = format!("public event EventHandler<CancelEventArgs>? {};", event.name);
            return Ok((lines, declaration));
        }

        Ok((
            vec![format!("{}?.Invoke(); return IntPtr.Zero;", event.name)],
            format!("public Action? {};", event.name),
        ))
    }
}

fn write_lines(w: &mut CodeWriter<String>, lines: &[String]) -> std::fmt::Result {
    for line in lines {
        w.writeln(line)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ApiMethod, ApiProperty, Primitive};

    fn schema() -> ApiSchema {
        let mut control = ApiType::class("Control");
        control.is_abstract = true;

        let mut point = ApiType::class("PointI");
        point.kind = crate::model::TypeKind::Struct;
        point.fields.push(crate::model::ApiField {
            name: "X".to_string(),
            ty: TypeRef::Primitive(Primitive::Int),
        });

        let mut widget = ApiType::class("Widget");
        widget.base = Some("Control".to_string());
        widget.properties.push(ApiProperty::new("Text", TypeRef::Text).read_write());
        widget.properties.push(ApiProperty::new("Parent", TypeRef::nullable(TypeRef::named("Control"))));
        widget.methods.push(ApiMethod::new("Click"));
        widget.methods.push(
            ApiMethod::new("Adopt")
                .param("child", TypeRef::named("Widget"))
                .returning(TypeRef::named("Widget")),
        );
        let mut count = ApiMethod::new("Count").returning(TypeRef::Primitive(Primitive::Int));
        count.is_static = true;
        widget.methods.push(count);
        widget.events.push(ApiEvent {
            name: "Clicked".to_string(),
            data: None,
            cancellable: false,
        });
        widget.events.push(ApiEvent {
            name: "Closing".to_string(),
            data: None,
            cancellable: true,
        });
        widget.events.push(ApiEvent {
            name: "Moved".to_string(),
            data: Some(TypeRef::named("PointI")),
            cancellable: false,
        });

        ApiSchema::new(vec![control, point, widget]).unwrap()
    }

    fn render(schema: &ApiSchema, index: usize) -> Emitted {
        let surface = TypeSurface::new(schema, &schema.types[index]);
        let slots = surface.slot_table().unwrap();
        emit(&surface, &surface.export_table().unwrap(), slots.as_ref(), &GeneratorConfig::default()).unwrap()
    }

    #[test]
    fn test_class_header_and_constructors() {
        let schema = schema();
        let text = render(&schema, 2).content;

        assert!(text.contains("namespace Native\n{\n    internal partial class Widget : Control\n    {\n"));
        assert!(text.contains("static Widget()\n        {\n            SetEventCallback();\n        }"));
        assert!(text.contains(
            "public Widget() : base(IntPtr.Zero)\n        {\n            SetNativePointer(NativeApi.Widget_Create());\n        }"
        ));
        assert!(text.contains("public Widget(IntPtr nativePointer) : base(nativePointer)"));
        assert!(text.contains("NativeApi.Widget_Destroy(NativePointer);"));
    }

    #[test]
    fn test_abstract_root_class() {
        let schema = schema();
        let text = render(&schema, 0).content;

        assert!(text.contains("internal abstract partial class Control : NativeObject"));
        assert!(text.contains("protected Control()\n        {\n        }"));
        assert!(!text.contains("Control_Create"));
    }

    #[test]
    fn test_members() {
        let schema = schema();
        let text = render(&schema, 2).content;

        assert!(text.contains("public string Text\n        {\n            get\n            {\n                if (IsNativeObjectDestroyed)\n                    return default!;\n                return NativeApi.Widget_GetText(NativePointer);\n            }"));
        assert!(text.contains("if (IsNativeObjectDestroyed)\n                    return;\n                NativeApi.Widget_SetText(NativePointer, value);"));
        assert!(text.contains("public Control? Parent"));
        assert!(text.contains("var _result = NativeObject.GetFromNativePointer<Control>(_handle, null);"));
        assert!(text.contains("public Widget Adopt(Widget child)"));
        assert!(text.contains("var _handle = NativeApi.Widget_Adopt(NativePointer, child.NativePointer);"));
        assert!(text.contains("var _result = NativeObject.GetFromNativePointer<Widget>(_handle, p => new Widget(p))!;"));
        assert!(text.contains("ReleaseNativeObjectPointer(_handle);"));
        assert!(text.contains("public static int Count()\n        {\n            return NativeApi.Widget_Count();\n        }"));
    }

    #[test]
    fn test_events() {
        let schema = schema();
        let text = render(&schema, 2).content;

        assert!(text.contains("case NativeApi.WidgetEvent.Clicked:"));
        assert!(text.contains("Clicked?.Invoke(); return IntPtr.Zero;"));
        assert!(text.contains("return cea.Cancel ? new IntPtr(1) : IntPtr.Zero;"));
        assert!(text.contains("var ea = new NativeEventArgs<PointI>(Marshal.PtrToStructure<PointI>(parameter));"));
        assert!(text.contains("default: throw new Exception(\"Unexpected WidgetEvent value: \" + e);"));
        assert!(text.contains("public Action? Clicked;"));
        assert!(text.contains("public event EventHandler<CancelEventArgs>? Closing;"));
        assert!(text.contains("public event NativeEventHandler<PointI>? Moved;"));
    }

    #[test]
    fn test_managed_server_members_are_virtual() {
        let mut ty = ApiType::class("Renderer");
        ty.managed_server = true;
        ty.methods.push(ApiMethod::new("Paint"));
        let schema = ApiSchema::new(vec![ty]).unwrap();
        let emitted = render(&schema, 0);

        assert!(emitted.content.contains("public virtual void Paint()"));
        assert!(emitted.content.contains("SetTrampolineLocator();"));
        assert!(emitted.content.contains("using System.Collections.Concurrent;"));
        let artifacts: Vec<&str> = emitted.slot_orders.iter().map(|(a, _)| *a).collect();
        assert_eq!(artifacts, vec!["managed enum", "managed dispatch switch"]);
    }

    #[test]
    fn test_non_struct_payload_rejected() {
        let mut ty = ApiType::class("Timer");
        ty.events.push(ApiEvent {
            name: "Tick".to_string(),
            data: Some(TypeRef::Primitive(Primitive::Int)),
            cancellable: false,
        });
        let schema = ApiSchema::new(vec![ty]).unwrap();
        let surface = TypeSurface::new(&schema, &schema.types[0]);

        let err = emit(&surface, &surface.export_table().unwrap(), None, &GeneratorConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            GenerateError::UnsupportedType { feature: "non-struct event payloads", .. }
        ));
    }

    #[test]
    fn test_array_members() {
        let mut panel = ApiType::class("Panel");
        panel.properties.push(ApiProperty::new("Children", "Panel[]".parse().unwrap()));
        let mut sizes = ApiProperty::new("Sizes", "int[]".parse().unwrap());
        sizes.is_static = true;
        panel.properties.push(sizes);
        panel.methods.push(ApiMethod::new("Adopt").param("children", "Panel[]".parse().unwrap()));
        let schema = ApiSchema::new(vec![panel]).unwrap();
        let text = render(&schema, 0).content;

        assert!(text.contains("public Panel[] Children"));
        assert!(text.contains(
            "                var array = NativeApi.Panel_OpenChildrenArray(NativePointer);\n                try\n                {\n                    var count = NativeApi.Panel_GetChildrenItemCount(NativePointer, array);\n"
        ));
        assert!(text.contains("var result = new System.Collections.Generic.List<Panel>(count);"));
        assert!(text.contains("var n = NativeApi.Panel_GetChildrenItemAt(NativePointer, array, i);"));
        assert!(text.contains("var item = NativeObject.GetFromNativePointer<Panel>(n, p => new Panel(p))!;"));
        assert!(text.contains("ReleaseNativeObjectPointer(n);"));
        assert!(text.contains(
            "finally\n                {\n                    NativeApi.Panel_CloseChildrenArray(NativePointer, array);\n                }"
        ));

        assert!(text.contains("public static int[] Sizes"));
        assert!(text.contains("var array = NativeApi.Panel_OpenSizesArray();"));
        assert!(text.contains("var n = NativeApi.Panel_GetSizesItemAt(array, i);\n                        result.Add(n);"));

        assert!(text.contains(
            "NativeApi.Panel_Adopt(NativePointer, Array.ConvertAll<Panel, IntPtr>(children, x => x.NativePointer), children.Length);"
        ));
    }

    #[test]
    fn test_managed_handle_owner_and_derived() {
        let mut renderer = ApiType::class("Renderer");
        renderer.managed_server = true;
        renderer.is_abstract = true;
        renderer.destructor = crate::model::MemberVisibility::Private;
        renderer.methods.push(ApiMethod::new("Paint"));
        let mut fancy = ApiType::class("FancyRenderer");
        fancy.base = Some("Renderer".to_string());
        let schema = ApiSchema::new(vec![renderer, fancy]).unwrap();

        let owner = render(&schema, 0).content;
        assert!(owner.contains("public Renderer(IntPtr nativePointer) : base(nativePointer)\n        {\n            AttachManagedHandle();\n        }"));
        assert!(owner.contains("GCHandle managedHandle;"));
        assert!(owner.contains("NativeApi.Renderer_SetManagedHandle(NativePointer, GCHandle.ToIntPtr(managedHandle));"));
        assert!(owner.contains("NativeApi.Renderer_SetManagedHandle(NativePointer, IntPtr.Zero);"));
        // Private destructor: no destroy export, so the release chains to the base
        assert!(owner.contains("ReleaseManagedHandle();\n            base.DestroyNativeObject();"));

        let derived = render(&schema, 1).content;
        assert!(derived.contains("SetNativePointer(NativeApi.FancyRenderer_Create());\n            AttachManagedHandle();"));
        assert!(derived.contains("protected override void DestroyNativeObject()\n        {\n            ReleaseManagedHandle();\n            if (NativePointer == IntPtr.Zero)"));
        assert!(!derived.contains("GCHandle managedHandle;"));
    }
}
