//! Type surface: the read-only view of one API class that every emitter walks
//!
//! The export table is computed here once per type and handed to both the
//! C-ABI emitter and the binding emitter, so the two symbol sets are
//! derived from one ordered list. C has no overloading, so every name in
//! the table must be unique.

use crate::error::{GenerateError, GenerateResult};
use crate::model::{ApiEvent, ApiMethod, ApiProperty, ApiSchema, ApiType, MemberVisibility, TypeRef};
use crate::trampoline::SlotTable;
use crate::types::Dialect;

static VOID_TYPE: TypeRef = TypeRef::Void;

/// A property accessor or method of a type, by declaration index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberRef {
    Getter(usize),
    Setter(usize),
    Method(usize),
}

/// The call shape of one accessor or method.
#[derive(Debug, Clone)]
pub struct MemberSignature<'a> {
    /// Native member name (`GetText`, `SetText`, `Click`)
    pub name: String,
    pub is_static: bool,
    pub returns: &'a TypeRef,
    pub params: Vec<(&'a str, &'a TypeRef)>,
}

impl MemberSignature<'_> {
    /// Flat parameter count including the receiver; an array parameter
    /// crosses as a pointer plus a count
    pub fn abi_arity(&self) -> usize {
        let params: usize = self
            .params
            .iter()
            .map(|(_, ty)| if ty.is_array() { 2 } else { 1 })
            .sum();
        usize::from(!self.is_static) + params
    }
}

impl MemberRef {
    pub fn signature(self, ty: &ApiType) -> MemberSignature<'_> {
        match self {
            MemberRef::Getter(index) => {
                let property = &ty.properties[index];
                MemberSignature {
                    name: format!("Get{}", property.name),
                    is_static: property.is_static,
                    returns: &property.ty,
                    params: Vec::new(),
                }
            }
            MemberRef::Setter(index) => {
                let property = &ty.properties[index];
                MemberSignature {
                    name: format!("Set{}", property.name),
                    is_static: property.is_static,
                    returns: &VOID_TYPE,
                    params: vec![("value", &property.ty)],
                }
            }
            MemberRef::Method(index) => {
                let method = &ty.methods[index];
                MemberSignature {
                    name: method.name.clone(),
                    is_static: method.is_static,
                    returns: &method.returns,
                    params: method
                        .parameters
                        .iter()
                        .map(|p| (p.name.as_str(), &p.ty))
                        .collect(),
                }
            }
        }
    }

    /// Accessors and methods in declaration order: each property's getter
    /// then setter (absent accessors skipped), followed by the methods.
    pub fn walk(ty: &ApiType) -> Vec<MemberRef> {
        let mut members = Vec::new();
        for (index, property) in ty.properties.iter().enumerate() {
            if property.get {
                members.push(MemberRef::Getter(index));
            }
            if property.set {
                members.push(MemberRef::Setter(index));
            }
        }
        members.extend((0..ty.methods.len()).map(MemberRef::Method));
        members
    }
}

/// One call of the protocol that reads an array property.
///
/// The wrapper opens a native snapshot of the array, reads its count and
/// items, then closes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayStep {
    Open,
    Count,
    ItemAt,
    Close,
}

impl ArrayStep {
    pub const ALL: [ArrayStep; 4] = [ArrayStep::Open, ArrayStep::Count, ArrayStep::ItemAt, ArrayStep::Close];

    /// Export name suffix for `property`
    pub fn member_name(self, property: &str) -> String {
        match self {
            ArrayStep::Open => format!("Open{}Array", property),
            ArrayStep::Count => format!("Get{}ItemCount", property),
            ArrayStep::ItemAt => format!("Get{}ItemAt", property),
            ArrayStep::Close => format!("Close{}Array", property),
        }
    }

    /// Parameters after the receiver: the opened array, then the index
    pub fn extra_arity(self) -> usize {
        match self {
            ArrayStep::Open => 0,
            ArrayStep::Count | ArrayStep::Close => 1,
            ArrayStep::ItemAt => 2,
        }
    }
}

/// What an exported C-ABI symbol does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Create,
    Destroy,
    Member(MemberRef),
    /// Getter of an array property, by property index
    ArrayAccess(usize, ArrayStep),
    SetEventCallback,
    SetTrampolineLocatorCallback,
    /// Stores the managed instance handle trampolines receive as `obj`
    SetManagedHandle,
}

/// One exported C-ABI symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedSymbol {
    pub name: String,
    pub kind: ExportKind,
    /// Parameter count including the receiver
    pub arity: usize,
}

impl ExportedSymbol {
    /// `name/arity`, the form parity checks compare
    pub fn signature(&self) -> String {
        format!("{}/{}", self.name, self.arity)
    }
}

/// The ordered C-ABI symbols of one type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTable {
    type_name: String,
    symbols: Vec<ExportedSymbol>,
}

impl ExportTable {
    /// Fails when two entries would share a symbol (a method named like a
    /// generated accessor, or an overload) or when a member returns an
    /// array any other way than through a read-only property.
    pub fn build(surface: &TypeSurface<'_>) -> GenerateResult<Self> {
        let ty = surface.ty();
        let mut symbols: Vec<ExportedSymbol> = Vec::new();
        let mut push = |name: String, kind: ExportKind, arity: usize| -> GenerateResult<()> {
            if symbols.iter().any(|s| s.name == name) {
                return Err(GenerateError::DuplicateSymbol {
                    type_name: ty.name.clone(),
                    symbol: name,
                });
            }
            symbols.push(ExportedSymbol { name, kind, arity });
            Ok(())
        };

        if surface.can_create() {
            push(format!("{}_Create", ty.name), ExportKind::Create, 0)?;
        }
        if surface.can_destroy() {
            push(format!("{}_Destroy", ty.name), ExportKind::Destroy, 1)?;
        }

        for member in MemberRef::walk(ty) {
            let signature = member.signature(ty);
            match member {
                MemberRef::Getter(index) if signature.returns.is_array() => {
                    let receiver = usize::from(!signature.is_static);
                    let property = &ty.properties[index].name;
                    for step in ArrayStep::ALL {
                        push(
                            format!("{}_{}", ty.name, step.member_name(property)),
                            ExportKind::ArrayAccess(index, step),
                            receiver + step.extra_arity(),
                        )?;
                    }
                    continue;
                }
                MemberRef::Setter(index) if ty.properties[index].ty.is_array() => {
                    return Err(GenerateError::unsupported(
                        Dialect::CAbi,
                        "writable array properties",
                        &ty.properties[index].ty,
                    ));
                }
                MemberRef::Method(_) if signature.returns.is_array() => {
                    return Err(GenerateError::unsupported(Dialect::CAbi, "array return values", signature.returns));
                }
                _ => {}
            }
            push(
                format!("{}_{}", ty.name, signature.name),
                ExportKind::Member(member),
                signature.abi_arity(),
            )?;
        }

        if surface.has_events() {
            push(format!("{}_SetEventCallback", ty.name), ExportKind::SetEventCallback, 1)?;
        }
        if surface.is_managed_server() {
            push(
                format!("{}_SetTrampolineLocatorCallback", ty.name),
                ExportKind::SetTrampolineLocatorCallback,
                1,
            )?;
        }
        if surface.owns_managed_handle() {
            push(format!("{}_SetManagedHandle", ty.name), ExportKind::SetManagedHandle, 2)?;
        }

        Ok(Self {
            type_name: ty.name.clone(),
            symbols,
        })
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExportedSymbol> {
        self.symbols.iter()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.symbols.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn find(&self, kind: ExportKind) -> Option<&ExportedSymbol> {
        self.symbols.iter().find(|s| s.kind == kind)
    }
}

/// Read-only view of one API type within its schema.
#[derive(Debug, Clone, Copy)]
pub struct TypeSurface<'s> {
    schema: &'s ApiSchema,
    ty: &'s ApiType,
}

impl<'s> TypeSurface<'s> {
    pub fn new(schema: &'s ApiSchema, ty: &'s ApiType) -> Self {
        Self { schema, ty }
    }

    pub fn schema(&self) -> &'s ApiSchema {
        self.schema
    }

    pub fn ty(&self) -> &'s ApiType {
        self.ty
    }

    pub fn name(&self) -> &'s str {
        &self.ty.name
    }

    /// Base type, only when it is an API class
    pub fn base(&self) -> Option<&'s ApiType> {
        self.schema.base_of(self.ty)
    }

    pub fn constructor(&self) -> MemberVisibility {
        self.ty.constructor
    }

    pub fn destructor(&self) -> MemberVisibility {
        self.ty.destructor
    }

    /// `{Type}_Create` is exported: public constructor on a concrete type
    pub fn can_create(&self) -> bool {
        self.ty.constructor.is_public() && !self.ty.is_abstract
    }

    /// `{Type}_Destroy` is exported
    pub fn can_destroy(&self) -> bool {
        self.ty.destructor.is_public()
    }

    pub fn properties(&self) -> &'s [ApiProperty] {
        &self.ty.properties
    }

    pub fn methods(&self) -> &'s [ApiMethod] {
        &self.ty.methods
    }

    pub fn events(&self) -> &'s [ApiEvent] {
        &self.ty.events
    }

    pub fn has_events(&self) -> bool {
        !self.ty.events.is_empty()
    }

    pub fn is_abstract(&self) -> bool {
        self.ty.is_abstract
    }

    pub fn is_struct(&self) -> bool {
        self.ty.is_struct()
    }

    pub fn is_enum(&self) -> bool {
        self.ty.is_enum()
    }

    pub fn is_flags_enum(&self) -> bool {
        self.ty.is_flags_enum()
    }

    pub fn is_managed_server(&self) -> bool {
        self.ty.managed_server
    }

    /// Nearest managed-server ancestor
    pub fn managed_server_base(&self) -> Option<&'s ApiType> {
        let mut current = self.base();
        while let Some(base) = current {
            if base.managed_server {
                return Some(base);
            }
            current = self.schema.base_of(base);
        }
        None
    }

    /// Instances carry a managed handle for trampolines to resolve
    pub fn has_managed_handle(&self) -> bool {
        self.is_managed_server() || self.managed_server_base().is_some()
    }

    /// First managed server in its inheritance chain; it declares the
    /// handle storage that derived types inherit
    pub fn owns_managed_handle(&self) -> bool {
        self.is_managed_server() && self.managed_server_base().is_none()
    }

    pub fn export_table(&self) -> GenerateResult<ExportTable> {
        ExportTable::build(self)
    }

    /// Trampoline slots, for managed-server types only
    pub fn slot_table(&self) -> GenerateResult<Option<SlotTable>> {
        if self.is_managed_server() {
            SlotTable::derive(self.ty).map(Some)
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ApiMethod, ApiProperty, ApiType, Primitive};

    fn widget() -> ApiType {
        let mut ty = ApiType::class("Widget");
        ty.managed_server = true;
        ty.properties.push(ApiProperty::new("Text", TypeRef::Text).read_write());
        ty.methods.push(ApiMethod::new("Click"));
        ty
    }

    #[test]
    fn test_widget_exports() {
        let schema = ApiSchema::new(vec![widget()]).unwrap();
        let surface = TypeSurface::new(&schema, &schema.types[0]);
        let table = surface.export_table().unwrap();

        assert_eq!(
            table.names(),
            vec![
                "Widget_Create",
                "Widget_Destroy",
                "Widget_GetText",
                "Widget_SetText",
                "Widget_Click",
                "Widget_SetTrampolineLocatorCallback",
                "Widget_SetManagedHandle",
            ]
        );
        let arities: Vec<usize> = table.iter().map(|s| s.arity).collect();
        assert_eq!(arities, vec![0, 1, 1, 2, 1, 1, 2]);
    }

    #[test]
    fn test_private_lifetime_and_abstract_suppress_exports() {
        let mut ty = ApiType::class("Handle");
        ty.constructor = MemberVisibility::Private;
        ty.destructor = MemberVisibility::Private;
        let mut shape = ApiType::class("Shape");
        shape.is_abstract = true;
        let schema = ApiSchema::new(vec![ty, shape]).unwrap();

        let handle = TypeSurface::new(&schema, &schema.types[0]);
        assert!(handle.export_table().unwrap().is_empty());

        let shape = TypeSurface::new(&schema, &schema.types[1]);
        assert_eq!(shape.export_table().unwrap().names(), vec!["Shape_Destroy"]);
    }

    #[test]
    fn test_static_members_have_no_receiver() {
        let mut ty = ApiType::class("Clipboard");
        let mut count = ApiProperty::new("Count", TypeRef::Primitive(Primitive::Int)).read_write();
        count.is_static = true;
        ty.properties.push(count);
        let mut method = ApiMethod::new("Put")
            .param("text", TypeRef::Text)
            .param("flags", TypeRef::Primitive(Primitive::Int));
        method.is_static = true;
        ty.methods.push(method);
        let schema = ApiSchema::new(vec![ty]).unwrap();
        let surface = TypeSurface::new(&schema, &schema.types[0]);

        let signatures: Vec<String> = surface.export_table().unwrap().iter().map(|s| s.signature()).collect();
        assert_eq!(
            signatures,
            vec![
                "Clipboard_Create/0",
                "Clipboard_Destroy/1",
                "Clipboard_GetCount/0",
                "Clipboard_SetCount/1",
                "Clipboard_Put/2",
            ]
        );
    }

    #[test]
    fn test_write_only_property_has_only_setter() {
        let mut ty = ApiType::class("Sink");
        let mut value = ApiProperty::new("Value", TypeRef::Primitive(Primitive::Double));
        value.get = false;
        value.set = true;
        ty.properties.push(value);

        assert_eq!(MemberRef::walk(&ty), vec![MemberRef::Setter(0)]);
        let signature = MemberRef::Setter(0).signature(&ty);
        assert_eq!(signature.name, "SetValue");
        assert!(signature.returns.is_void());
        assert_eq!(signature.params.len(), 1);
    }

    fn table_of(ty: ApiType) -> GenerateResult<ExportTable> {
        let schema = ApiSchema::new(vec![ApiType::class("Control"), ty]).unwrap();
        let surface = TypeSurface::new(&schema, &schema.types[1]);
        surface.export_table()
    }

    #[test]
    fn test_method_named_like_getter_collides() {
        let mut ty = ApiType::class("Widget");
        ty.properties.push(ApiProperty::new("Text", TypeRef::Text));
        ty.methods.push(ApiMethod::new("GetText").returning(TypeRef::Text));

        match table_of(ty) {
            Err(GenerateError::DuplicateSymbol { type_name, symbol }) => {
                assert_eq!(type_name, "Widget");
                assert_eq!(symbol, "Widget_GetText");
            }
            other => panic!("expected duplicate symbol, got {:?}", other),
        }
    }

    #[test]
    fn test_overloads_collide() {
        let mut ty = ApiType::class("Clipboard");
        ty.methods.push(ApiMethod::new("Put").param("text", TypeRef::Text));
        ty.methods
            .push(ApiMethod::new("Put").param("value", TypeRef::Primitive(Primitive::Int)));

        assert!(matches!(
            table_of(ty),
            Err(GenerateError::DuplicateSymbol { symbol, .. }) if symbol == "Clipboard_Put"
        ));
    }

    #[test]
    fn test_array_property_exports_accessor_protocol() {
        let mut ty = ApiType::class("Panel");
        ty.properties.push(ApiProperty::new("Children", "Control[]".parse().unwrap()));
        let mut names = ApiProperty::new("Names", "string[]".parse().unwrap());
        names.is_static = true;
        ty.properties.push(names);

        let table = table_of(ty).unwrap();
        let signatures: Vec<String> = table.iter().map(|s| s.signature()).collect();
        assert_eq!(
            signatures,
            vec![
                "Panel_Create/0",
                "Panel_Destroy/1",
                "Panel_OpenChildrenArray/1",
                "Panel_GetChildrenItemCount/2",
                "Panel_GetChildrenItemAt/3",
                "Panel_CloseChildrenArray/2",
                "Panel_OpenNamesArray/0",
                "Panel_GetNamesItemCount/1",
                "Panel_GetNamesItemAt/2",
                "Panel_CloseNamesArray/1",
            ]
        );
        assert_eq!(
            table.find(ExportKind::ArrayAccess(0, ArrayStep::ItemAt)).map(|s| s.name.as_str()),
            Some("Panel_GetChildrenItemAt")
        );
    }

    #[test]
    fn test_array_parameter_adds_count() {
        let mut ty = ApiType::class("Chart");
        ty.methods.push(
            ApiMethod::new("Plot")
                .param("values", "double[]".parse().unwrap())
                .param("color", TypeRef::Primitive(Primitive::Int)),
        );
        let table = table_of(ty).unwrap();
        assert_eq!(table.find(ExportKind::Member(MemberRef::Method(0))).map(|s| s.arity), Some(4));
    }

    #[test]
    fn test_array_results_outside_properties_rejected() {
        let mut ty = ApiType::class("Chart");
        ty.methods.push(ApiMethod::new("Values").returning("double[]".parse().unwrap()));
        assert!(matches!(
            table_of(ty),
            Err(GenerateError::UnsupportedType { feature: "array return values", .. })
        ));

        let mut ty = ApiType::class("Chart");
        ty.properties
            .push(ApiProperty::new("Values", "double[]".parse().unwrap()).read_write());
        assert!(matches!(
            table_of(ty),
            Err(GenerateError::UnsupportedType { feature: "writable array properties", .. })
        ));
    }

    #[test]
    fn test_managed_handle_owned_by_first_server() {
        let mut widget = ApiType::class("Widget");
        widget.managed_server = true;
        let mut label = ApiType::class("Label");
        label.base = Some("Widget".to_string());
        label.managed_server = true;
        let mut caption = ApiType::class("Caption");
        caption.base = Some("Label".to_string());
        let schema = ApiSchema::new(vec![widget, label, caption]).unwrap();

        let surfaces: Vec<TypeSurface<'_>> = schema.types.iter().map(|t| TypeSurface::new(&schema, t)).collect();
        let owns: Vec<bool> = surfaces.iter().map(|s| s.owns_managed_handle()).collect();
        let has: Vec<bool> = surfaces.iter().map(|s| s.has_managed_handle()).collect();
        assert_eq!(owns, vec![true, false, false]);
        assert_eq!(has, vec![true, true, true]);
        assert_eq!(surfaces[2].managed_server_base().map(|b| b.name.as_str()), Some("Label"));

        let label_exports = surfaces[1].export_table().unwrap();
        assert!(label_exports.find(ExportKind::SetManagedHandle).is_none());
        assert!(label_exports.find(ExportKind::SetTrampolineLocatorCallback).is_some());
    }
}
