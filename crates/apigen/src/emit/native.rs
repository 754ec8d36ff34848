//! Native class body fragment (`Api/{Type}.inc`)
//!
//! The fragment is included at the top of the hand-written class in
//! `{Type}.h`. It declares everything the C-ABI shim calls; the scaffold
//! `{Type}.cpp` holds the definitions. API classes used by reference are
//! forward-declared in `ApiTypes.h`, so the fragment carries no includes.

use super::{parameter_list, trampoline, write_header, writer, Emitted};
use crate::code_writer::CodeWriter;
use crate::config::GeneratorConfig;
use crate::cw_writeln;
use crate::error::GenerateResult;
use crate::surface::{MemberRef, TypeSurface};
use crate::trampoline::SlotTable;
use crate::types::{NativeTypes, TypeNames, TypeUsage};

/// One member declaration, shared with the scaffold definitions
pub(crate) struct NativeMember {
    pub member: MemberRef,
    pub is_static: bool,
    pub returns: String,
    pub name: String,
    pub params: Vec<String>,
    pub returns_void: bool,
}

/// Native declarations of every accessor and method, in declaration order
pub(crate) fn native_members(surface: &TypeSurface<'_>) -> GenerateResult<Vec<NativeMember>> {
    let ty = surface.ty();
    let resolver = NativeTypes::new(surface.schema());
    let mut names = TypeNames::new(&resolver);

    MemberRef::walk(ty)
        .into_iter()
        .map(|member| -> GenerateResult<NativeMember> {
            let signature = member.signature(ty);
            Ok(NativeMember {
                member,
                is_static: signature.is_static,
                returns: names.name(signature.returns, TypeUsage::RETURN)?,
                params: parameter_list(&mut names, &signature.params, TypeUsage::ARGUMENT)?,
                returns_void: signature.returns.is_void(),
                name: signature.name,
            })
        })
        .collect()
}

/// Render the fragment for one class type
pub fn emit(surface: &TypeSurface<'_>, slots: Option<&SlotTable>, config: &GeneratorConfig) -> GenerateResult<Emitted> {
    let ty = surface.ty();
    let members = native_members(surface)?;
    let mut emitted = Emitted::default();

    let mut w = writer(config);
    write_header(&mut w, config)?;
    w.writeln("public:")?;
    {
        let _indent = w.indent();
        if surface.constructor().is_public() {
            cw_writeln!(w, "{}();", ty.name)?;
        }
        if surface.destructor().is_public() {
            cw_writeln!(w, "virtual ~{}();", ty.name)?;
        }
        if !members.is_empty() {
            w.blank_line()?;
        }
        for member in &members {
            let prefix = if member.is_static { "static " } else { "" };
            cw_writeln!(
                w,
                "{}{} {}({});",
                prefix,
                member.returns,
                member.name,
                member.params.join(", ")
            )?;
        }
    }

    if surface.has_events() {
        w.blank_line()?;
        events(&mut w, surface)?;
    }

    if let Some(slots) = slots {
        w.blank_line()?;
        let order = trampoline::emit_native(&mut w, surface, slots)?;
        emitted.slot_orders.push(("native enum", order));
    }

    if surface.owns_managed_handle() {
        w.blank_line()?;
        managed_handle(&mut w)?;
    }

    if !surface.constructor().is_public() || !surface.destructor().is_public() {
        w.blank_line()?;
        w.writeln("private:")?;
        let _indent = w.indent();
        if !surface.constructor().is_public() {
            cw_writeln!(w, "{}();", ty.name)?;
        }
        if !surface.destructor().is_public() {
            cw_writeln!(w, "virtual ~{}();", ty.name)?;
        }
    }

    emitted.content = w.into_inner();
    Ok(emitted)
}

/// Storage for the managed wrapper's handle, inherited by derived types
fn managed_handle(w: &mut CodeWriter<String>) -> GenerateResult<()> {
    w.writeln("public:")?;
    {
        let _indent = w.indent();
        w.block("void SetManagedHandle(void* value)", |w| w.writeln("managedHandle = value;"))?;
        w.block("void* GetManagedHandle() const", |w| w.writeln("return managedHandle;"))?;
    }
    w.blank_line()?;
    w.writeln("private:")?;
    let _indent = w.indent();
    w.writeln("void* managedHandle = nullptr;")?;
    Ok(())
}

fn events(w: &mut CodeWriter<String>, surface: &TypeSurface<'_>) -> GenerateResult<()> {
    let ty = surface.ty();
    let callback_type = format!("{}EventCallbackType", ty.name);

    w.writeln("public:")?;
    {
        let _indent = w.indent();
        w.block_with_suffix(&format!("enum class {}Event", ty.name), ";", |w| {
            for event in surface.events() {
                cw_writeln!(w, "{},", event.name)?;
            }
            Ok::<(), std::fmt::Error>(())
        })?;
        w.blank_line()?;
        cw_writeln!(
            w,
            "typedef void* (NATIVE_CALLBACK_CALL* {})({}* obj, {}Event event, void* parameter);",
            callback_type,
            ty.name,
            ty.name
        )?;
        w.blank_line()?;
        w.block(&format!("static void SetEventCallback({} value)", callback_type), |w| {
            w.writeln("EventCallback() = value;")
        })?;
    }

    w.blank_line()?;
    w.writeln("protected:")?;
    {
        let _indent = w.indent();
        if let Some(base) = surface.base().filter(|b| !b.events.is_empty()) {
            cw_writeln!(w, "using {}::RaiseEvent;", base.name)?;
            w.blank_line()?;
        }
        w.block(
            &format!("void* RaiseEvent({}Event event, void* parameter = nullptr)", ty.name),
            |w| {
                cw_writeln!(w, "{} callback = EventCallback();", callback_type)?;
                w.writeln("if (callback == nullptr)")?;
                {
                    let _indent = w.indent();
                    w.writeln("return nullptr;")?;
                }
                w.writeln("return callback(this, event, parameter);")
            },
        )?;
    }

    w.blank_line()?;
    w.writeln("private:")?;
    {
        let _indent = w.indent();
        w.block(&format!("static {}& EventCallback()", callback_type), |w| {
            cw_writeln!(w, "static {} callback = nullptr;", callback_type)?;
            w.writeln("return callback;")
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenerateError;
    use crate::model::{ApiEvent, ApiMethod, ApiProperty, ApiSchema, ApiType, MemberVisibility, Primitive, TypeRef};

    fn schema() -> ApiSchema {
        let mut control = ApiType::class("Control");
        control.events.push(ApiEvent {
            name: "Paint".to_string(),
            data: None,
            cancellable: false,
        });

        let mut point = ApiType::class("PointI");
        point.kind = crate::model::TypeKind::Struct;

        let mut widget = ApiType::class("Widget");
        widget.base = Some("Control".to_string());
        widget.destructor = MemberVisibility::Private;
        widget.properties.push(ApiProperty::new("Text", TypeRef::Text).read_write());
        widget.properties.push(ApiProperty::new("Owner", TypeRef::nullable(TypeRef::named("Control"))));
        widget.methods.push(
            ApiMethod::new("MoveTo")
                .param("position", TypeRef::named("PointI"))
                .param("relativeTo", TypeRef::named("Control"))
                .returning(TypeRef::Primitive(Primitive::Bool)),
        );
        let mut create = ApiMethod::new("CreateDefault").returning(TypeRef::named("Widget"));
        create.is_static = true;
        widget.methods.push(create);
        widget.events.push(ApiEvent {
            name: "Click".to_string(),
            data: None,
            cancellable: false,
        });
        ApiSchema::new(vec![control, point, widget]).unwrap()
    }

    fn render() -> String {
        let schema = schema();
        let surface = TypeSurface::new(&schema, &schema.types[2]);
        emit(&surface, None, &GeneratorConfig::default()).unwrap().content
    }

    #[test]
    fn test_member_declarations() {
        let text = render();
        assert!(text.contains("public:\n    Widget();\n\n    string GetText();\n    void SetText(const string& value);\n"));
        assert!(text.contains("    Control* GetOwner();\n"));
        assert!(text.contains("    bool MoveTo(const PointI& position, Control& relativeTo);\n"));
        assert!(text.contains("    static Widget& CreateDefault();\n"));
        assert!(text.ends_with("private:\n    virtual ~Widget();\n"));
    }

    #[test]
    fn test_event_plumbing() {
        let text = render();
        assert!(text.contains("enum class WidgetEvent\n    {\n        Click,\n    };"));
        assert!(text.contains(
            "typedef void* (NATIVE_CALLBACK_CALL* WidgetEventCallbackType)(Widget* obj, WidgetEvent event, void* parameter);"
        ));
        assert!(text.contains("using Control::RaiseEvent;"));
        assert!(text.contains("if (callback == nullptr)\n            return nullptr;"));
    }

    #[test]
    fn test_nullable_value_member_fails() {
        let mut ty = ApiType::class("Gauge");
        ty.properties
            .push(ApiProperty::new("Limit", TypeRef::nullable(TypeRef::Primitive(Primitive::Double))));
        let schema = ApiSchema::new(vec![ty]).unwrap();
        let surface = TypeSurface::new(&schema, &schema.types[0]);
        assert!(matches!(
            emit(&surface, None, &GeneratorConfig::default()),
            Err(GenerateError::UnsupportedType { feature: "nullable value types", .. })
        ));
    }

    #[test]
    fn test_managed_handle_storage_on_first_server() {
        let mut renderer = ApiType::class("Renderer");
        renderer.managed_server = true;
        renderer.methods.push(ApiMethod::new("Paint"));
        let mut fancy = ApiType::class("FancyRenderer");
        fancy.base = Some("Renderer".to_string());
        fancy.managed_server = true;
        let schema = ApiSchema::new(vec![renderer, fancy]).unwrap();

        let owner = TypeSurface::new(&schema, &schema.types[0]);
        let slots = owner.slot_table().unwrap();
        let text = emit(&owner, slots.as_ref(), &GeneratorConfig::default()).unwrap().content;
        assert!(text.contains("    void SetManagedHandle(void* value)
    {
        managedHandle = value;
    }"));
        assert!(text.contains("    void* GetManagedHandle() const
"));
        assert!(text.contains("private:
    void* managedHandle = nullptr;
"));

        let derived = TypeSurface::new(&schema, &schema.types[1]);
        let slots = derived.slot_table().unwrap();
        let text = emit(&derived, slots.as_ref(), &GeneratorConfig::default()).unwrap().content;
        assert!(!text.contains("managedHandle"));
    }

    #[test]
    fn test_array_members_use_vectors() {
        let mut panel = ApiType::class("Panel");
        panel.properties
            .push(ApiProperty::new("Sizes", TypeRef::Array(Box::new(TypeRef::Primitive(Primitive::Int)))));
        panel.methods.push(
            ApiMethod::new("SetChildren").param("children", TypeRef::Array(Box::new(TypeRef::named("Panel")))),
        );
        let schema = ApiSchema::new(vec![panel]).unwrap();
        let surface = TypeSurface::new(&schema, &schema.types[0]);
        let text = emit(&surface, None, &GeneratorConfig::default()).unwrap().content;

        assert!(text.contains("    std::vector<int> GetSizes();
"));
        assert!(text.contains("    void SetChildren(const std::vector<Panel*>& children);
"));
    }
}
