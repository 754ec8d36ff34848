//! Per-dialect type-name resolution
//!
//! The same schema type is spelled differently in every dialect and, within a
//! dialect, differently depending on where it appears ([`TypeUsage`]). Each
//! dialect implements [`TypeResolver`]; [`TypeNames`] wraps one resolver and
//! accumulates the header dependencies of the file being emitted.

mod binding;
mod cabi;
mod managed;
mod native;

pub use binding::BindingTypes;
pub use cabi::CAbiTypes;
pub use managed::ManagedTypes;
pub use native::NativeTypes;

pub(crate) use managed::csharp_keyword;

use bitflags::bitflags;
use std::collections::BTreeSet;
use std::fmt;

use crate::error::{GenerateError, GenerateResult};
use crate::model::{ApiSchema, ApiType, Primitive, TypeKind, TypeRef};

bitflags! {
    /// Where a type reference appears.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TypeUsage: u8 {
        /// Declaration position (field, base clause, static member type)
        const STATIC = 0b001;
        /// Parameter
        const ARGUMENT = 0b010;
        /// Return value
        const RETURN = 0b100;
    }
}

/// Resolved position of a usage; STATIC wins over ARGUMENT, ARGUMENT over RETURN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Position {
    Declaration,
    Argument,
    Return,
}

impl TypeUsage {
    pub(crate) fn position(self) -> Position {
        if self.contains(TypeUsage::STATIC) || self.is_empty() {
            Position::Declaration
        } else if self.contains(TypeUsage::ARGUMENT) {
            Position::Argument
        } else {
            Position::Return
        }
    }
}

/// Output dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// C# wrapper classes
    Managed,
    /// C# `[DllImport]` declarations
    Binding,
    /// C++ class bodies
    Native,
    /// C-linkage shim functions
    CAbi,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Dialect::Managed => "managed",
            Dialect::Binding => "native-call binding",
            Dialect::Native => "native",
            Dialect::CAbi => "C ABI",
        })
    }
}

/// A literal type spelling plus the artifact it depends on, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub literal: String,
    pub include: Option<String>,
}

impl Resolved {
    pub(crate) fn plain(literal: impl Into<String>) -> Self {
        Self {
            literal: literal.into(),
            include: None,
        }
    }

    pub(crate) fn with_include(literal: impl Into<String>, include: impl Into<String>) -> Self {
        Self {
            literal: literal.into(),
            include: Some(include.into()),
        }
    }
}

/// Spells schema types in one dialect.
pub trait TypeResolver {
    fn dialect(&self) -> Dialect;

    fn resolve(&self, ty: &TypeRef, usage: TypeUsage) -> GenerateResult<Resolved>;
}

/// What a type reference turned out to be once looked up in the schema.
#[derive(Debug, Clone)]
pub enum Shape<'s> {
    Void,
    Primitive(Primitive),
    Text { nullable: bool },
    Struct(&'s ApiType),
    Enum(&'s ApiType),
    Class { ty: &'s ApiType, nullable: bool },
    /// `T?` over a value type
    NullableValue(Box<Shape<'s>>),
    /// `T[]`; the element is never nullable, void or another array
    Array(Box<Shape<'s>>),
}

impl Shape<'_> {
    pub fn is_class(&self) -> bool {
        matches!(self, Shape::Class { .. })
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Shape::Text { .. })
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Shape::Primitive(Primitive::Bool))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Shape::Array(_))
    }
}

/// Look a type reference up in the schema.
///
/// Generic instantiations are rejected here for every dialect, as are
/// arrays of nullable, void or array elements.
pub fn shape_of<'s>(schema: &'s ApiSchema, ty: &TypeRef, dialect: Dialect) -> GenerateResult<Shape<'s>> {
    match ty {
        TypeRef::Void => Ok(Shape::Void),
        TypeRef::Primitive(p) => Ok(Shape::Primitive(*p)),
        TypeRef::Text => Ok(Shape::Text { nullable: false }),
        TypeRef::Named(name) => {
            let api = schema.get(name).ok_or_else(|| GenerateError::UnknownType {
                type_name: name.clone(),
                context: format!("the {} resolver", dialect),
            })?;
            Ok(match api.kind {
                TypeKind::Class => Shape::Class {
                    ty: api,
                    nullable: false,
                },
                TypeKind::Struct => Shape::Struct(api),
                TypeKind::Enum => Shape::Enum(api),
            })
        }
        TypeRef::Nullable(inner) => match shape_of(schema, inner, dialect)? {
            Shape::Text { .. } => Ok(Shape::Text { nullable: true }),
            Shape::Class { ty, .. } => Ok(Shape::Class { ty, nullable: true }),
            Shape::Array(_) => Err(GenerateError::unsupported(dialect, "nullable arrays", ty)),
            value => Ok(Shape::NullableValue(Box::new(value))),
        },
        TypeRef::Array(element) => match element.as_ref() {
            TypeRef::Array(_) => Err(GenerateError::unsupported(dialect, "nested arrays", ty)),
            TypeRef::Nullable(_) => Err(GenerateError::unsupported(dialect, "nullable array elements", ty)),
            TypeRef::Void => Err(GenerateError::unsupported(dialect, "void array elements", ty)),
            element => Ok(Shape::Array(Box::new(shape_of(schema, element, dialect)?))),
        },
        TypeRef::Generic(_) => Err(GenerateError::unsupported(dialect, "generic types", ty)),
    }
}

/// Element of an array parameter, which crosses the boundary as a pointer
/// plus a count. Text and booleans have no element layout both sides share.
pub(crate) fn parameter_element<'a, 's>(
    element: &'a Shape<'s>,
    dialect: Dialect,
    ty: &TypeRef,
) -> GenerateResult<&'a Shape<'s>> {
    match element {
        Shape::Text { .. } => Err(GenerateError::unsupported(dialect, "text array parameters", ty)),
        Shape::Primitive(Primitive::Bool) => Err(GenerateError::unsupported(dialect, "bool array parameters", ty)),
        _ => Ok(element),
    }
}

/// Header (or using) dependencies of one emitted file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncludeSet {
    entries: BTreeSet<String>,
}

impl IncludeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, include: impl Into<String>) {
        self.entries.insert(include.into());
    }

    pub fn remove(&mut self, include: &str) {
        self.entries.remove(include);
    }

    pub fn contains(&self, include: &str) -> bool {
        self.entries.contains(include)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entries in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

/// A resolver bound to the include set of the file being emitted.
pub struct TypeNames<'r> {
    resolver: &'r dyn TypeResolver,
    includes: IncludeSet,
}

impl<'r> TypeNames<'r> {
    pub fn new(resolver: &'r dyn TypeResolver) -> Self {
        Self {
            resolver,
            includes: IncludeSet::new(),
        }
    }

    /// Resolve and record the dependency
    pub fn name(&mut self, ty: &TypeRef, usage: TypeUsage) -> GenerateResult<String> {
        let resolved = self.resolver.resolve(ty, usage)?;
        if let Some(include) = resolved.include {
            self.includes.insert(include);
        }
        Ok(resolved.literal)
    }

    pub fn dialect(&self) -> Dialect {
        self.resolver.dialect()
    }

    pub fn includes(&self) -> &IncludeSet {
        &self.includes
    }

    pub fn into_includes(self) -> IncludeSet {
        self.includes
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::{ApiField, ApiSchema, ApiType, TypeKind};

    pub(crate) fn sample_schema() -> ApiSchema {
        let mut point = ApiType::class("PointI");
        point.kind = TypeKind::Struct;
        point.fields = vec![
            ApiField {
                name: "X".to_string(),
                ty: TypeRef::Primitive(Primitive::Int),
            },
            ApiField {
                name: "Y".to_string(),
                ty: TypeRef::Primitive(Primitive::Int),
            },
        ];

        let mut anchors = ApiType::class("Anchors");
        anchors.kind = TypeKind::Enum;
        anchors.flags = true;

        ApiSchema::new(vec![ApiType::class("Control"), point, anchors]).unwrap()
    }

    fn ty(text: &str) -> TypeRef {
        text.parse().unwrap()
    }

    #[test]
    fn test_usage_precedence() {
        assert_eq!((TypeUsage::STATIC | TypeUsage::ARGUMENT).position(), Position::Declaration);
        assert_eq!((TypeUsage::ARGUMENT | TypeUsage::RETURN).position(), Position::Argument);
        assert_eq!(TypeUsage::RETURN.position(), Position::Return);
        assert_eq!(TypeUsage::empty().position(), Position::Declaration);
    }

    #[test]
    fn test_struct_argument_and_return() {
        let schema = sample_schema();
        let native = NativeTypes::new(&schema);
        let cabi = CAbiTypes::new(&schema);
        let point = ty("PointI");

        assert_eq!(native.resolve(&point, TypeUsage::ARGUMENT).unwrap().literal, "const PointI&");
        assert_eq!(cabi.resolve(&point, TypeUsage::ARGUMENT).unwrap().literal, "PointI");
        assert_eq!(native.resolve(&point, TypeUsage::RETURN).unwrap().literal, "PointI");
        assert_eq!(cabi.resolve(&point, TypeUsage::RETURN).unwrap().literal, "PointI");
        assert_eq!(native.resolve(&point, TypeUsage::ARGUMENT).unwrap().include, None);
    }

    #[test]
    fn test_class_reference_per_dialect() {
        let schema = sample_schema();
        let control = ty("Control");

        let native = NativeTypes::new(&schema);
        assert_eq!(native.resolve(&control, TypeUsage::STATIC).unwrap().literal, "Control");
        assert_eq!(native.resolve(&control, TypeUsage::ARGUMENT).unwrap().literal, "Control&");
        assert_eq!(native.resolve(&ty("Control?"), TypeUsage::RETURN).unwrap().literal, "Control*");

        let cabi = CAbiTypes::new(&schema);
        assert_eq!(cabi.resolve(&control, TypeUsage::ARGUMENT).unwrap().literal, "Control*");
        assert_eq!(
            cabi.resolve(&control, TypeUsage::RETURN).unwrap().include.as_deref(),
            Some("Control.h")
        );

        let managed = ManagedTypes::new(&schema);
        assert_eq!(managed.resolve(&control, TypeUsage::RETURN).unwrap().literal, "Control");
        assert_eq!(managed.resolve(&ty("Control?"), TypeUsage::ARGUMENT).unwrap().literal, "Control?");

        let binding = BindingTypes::new(&schema);
        assert_eq!(binding.resolve(&control, TypeUsage::ARGUMENT).unwrap().literal, "IntPtr");
    }

    #[test]
    fn test_text_per_dialect() {
        let schema = sample_schema();
        let text = TypeRef::Text;

        assert_eq!(NativeTypes::new(&schema).resolve(&text, TypeUsage::ARGUMENT).unwrap().literal, "const string&");
        assert_eq!(NativeTypes::new(&schema).resolve(&text, TypeUsage::RETURN).unwrap().literal, "string");
        assert_eq!(CAbiTypes::new(&schema).resolve(&text, TypeUsage::ARGUMENT).unwrap().literal, "const char16_t*");
        assert_eq!(CAbiTypes::new(&schema).resolve(&text, TypeUsage::RETURN).unwrap().literal, "char16_t*");
        assert_eq!(
            BindingTypes::new(&schema).resolve(&text, TypeUsage::ARGUMENT).unwrap().literal,
            "[MarshalAs(UnmanagedType.LPWStr)] string"
        );
        assert_eq!(ManagedTypes::new(&schema).resolve(&text, TypeUsage::RETURN).unwrap().literal, "string");
    }

    #[test]
    fn test_void_never_includes() {
        let schema = sample_schema();
        let managed = ManagedTypes::new(&schema);
        let binding = BindingTypes::new(&schema);
        let native = NativeTypes::new(&schema);
        let cabi = CAbiTypes::new(&schema);
        let resolvers: [&dyn TypeResolver; 4] = [&managed, &binding, &native, &cabi];
        for resolver in resolvers {
            let resolved = resolver.resolve(&TypeRef::Void, TypeUsage::RETURN).unwrap();
            assert_eq!(resolved.literal, "void");
            assert_eq!(resolved.include, None);
        }
    }

    #[test]
    fn test_enum_passes_through() {
        let schema = sample_schema();
        let anchors = ty("Anchors");
        assert_eq!(NativeTypes::new(&schema).resolve(&anchors, TypeUsage::ARGUMENT).unwrap().literal, "Anchors");
        assert_eq!(CAbiTypes::new(&schema).resolve(&anchors, TypeUsage::RETURN).unwrap().literal, "Anchors");
        assert_eq!(BindingTypes::new(&schema).resolve(&anchors, TypeUsage::ARGUMENT).unwrap().literal, "Anchors");
    }

    #[test]
    fn test_nullable_value_rejected_by_native() {
        let schema = sample_schema();
        let err = NativeTypes::new(&schema)
            .resolve(&ty("int?"), TypeUsage::ARGUMENT)
            .unwrap_err();
        assert!(matches!(
            err,
            GenerateError::UnsupportedType { dialect: Dialect::Native, feature: "nullable value types", .. }
        ));
        assert_eq!(
            ManagedTypes::new(&schema).resolve(&ty("PointI?"), TypeUsage::ARGUMENT).unwrap().literal,
            "PointI?"
        );
    }

    #[test]
    fn test_generics_and_unknown_names_fail() {
        let schema = sample_schema();
        let managed = ManagedTypes::new(&schema);
        assert!(matches!(
            managed.resolve(&ty("List<int>"), TypeUsage::ARGUMENT),
            Err(GenerateError::UnsupportedType { feature: "generic types", .. })
        ));
        assert!(matches!(
            managed.resolve(&ty("Missing"), TypeUsage::ARGUMENT),
            Err(GenerateError::UnknownType { .. })
        ));
    }

    #[test]
    fn test_array_parameter_per_dialect() {
        let schema = sample_schema();
        let ints = ty("int[]");
        let controls = ty("Control[]");

        let managed = ManagedTypes::new(&schema);
        assert_eq!(managed.resolve(&ints, TypeUsage::ARGUMENT).unwrap().literal, "int[]");
        assert_eq!(managed.resolve(&controls, TypeUsage::RETURN).unwrap().literal, "Control[]");

        let binding = BindingTypes::new(&schema);
        assert_eq!(binding.resolve(&ty("PointI[]"), TypeUsage::ARGUMENT).unwrap().literal, "PointI[]");
        assert_eq!(binding.resolve(&controls, TypeUsage::ARGUMENT).unwrap().literal, "IntPtr[]");

        let native = NativeTypes::new(&schema);
        assert_eq!(native.resolve(&ints, TypeUsage::ARGUMENT).unwrap().literal, "const std::vector<int>&");
        assert_eq!(native.resolve(&controls, TypeUsage::RETURN).unwrap().literal, "std::vector<Control*>");

        let cabi = CAbiTypes::new(&schema);
        assert_eq!(cabi.resolve(&ints, TypeUsage::ARGUMENT).unwrap().literal, "const int*");
        let resolved = cabi.resolve(&controls, TypeUsage::ARGUMENT).unwrap();
        assert_eq!(resolved.literal, "Control**");
        assert_eq!(resolved.include.as_deref(), Some("Control.h"));
    }

    #[test]
    fn test_unsupported_arrays_fail() {
        let schema = sample_schema();
        let managed = ManagedTypes::new(&schema);
        let cabi = CAbiTypes::new(&schema);
        let binding = BindingTypes::new(&schema);

        assert!(matches!(
            managed.resolve(&ty("int[][]"), TypeUsage::ARGUMENT),
            Err(GenerateError::UnsupportedType { feature: "nested arrays", .. })
        ));
        assert!(matches!(
            managed.resolve(&ty("Control?[]"), TypeUsage::ARGUMENT),
            Err(GenerateError::UnsupportedType { feature: "nullable array elements", .. })
        ));
        assert!(matches!(
            cabi.resolve(&ty("string[]"), TypeUsage::ARGUMENT),
            Err(GenerateError::UnsupportedType { feature: "text array parameters", .. })
        ));
        assert!(matches!(
            binding.resolve(&ty("bool[]"), TypeUsage::ARGUMENT),
            Err(GenerateError::UnsupportedType { feature: "bool array parameters", .. })
        ));
        assert!(matches!(
            cabi.resolve(&ty("int[]"), TypeUsage::RETURN),
            Err(GenerateError::UnsupportedType { feature: "array return values", .. })
        ));
        assert!(matches!(
            NativeTypes::new(&schema).resolve(&ty("int[]"), TypeUsage::STATIC),
            Err(GenerateError::UnsupportedType { feature: "array fields", .. })
        ));
    }

    #[test]
    fn test_type_names_accumulates_includes() {
        let schema = sample_schema();
        let native = NativeTypes::new(&schema);
        let mut names = TypeNames::new(&native);
        names.name(&ty("Control"), TypeUsage::ARGUMENT).unwrap();
        names.name(&ty("Control?"), TypeUsage::RETURN).unwrap();
        names.name(&ty("PointI"), TypeUsage::ARGUMENT).unwrap();

        let includes = names.into_includes();
        assert_eq!(includes.len(), 1);
        assert!(includes.contains("Control.h"));
    }
}
