//! API type surface model
//!
//! The schema is the language-agnostic description of the API surface.
//! It is produced by an external reflection front end and loaded from
//! TOML or JSON. Member order is declaration order and is significant:
//! export tables and trampoline slots are derived from it.

mod schema;
mod type_ref;

pub use schema::{ApiSchema, SchemaError};
pub use type_ref::{Primitive, TypeRef};

use serde::{Deserialize, Serialize};

/// What kind of declaration an API type is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    #[default]
    Class,
    Struct,
    Enum,
}

/// Visibility of a constructor or destructor.
///
/// `Private` suppresses the corresponding ABI and wrapper code: the type is
/// only constructible on the native side, or intentionally never destroyed
/// from the managed side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberVisibility {
    #[default]
    Public,
    Private,
}

impl MemberVisibility {
    pub fn is_public(self) -> bool {
        self == MemberVisibility::Public
    }

    /// C# modifier keyword
    pub fn keyword(self) -> &'static str {
        match self {
            MemberVisibility::Public => "public",
            MemberVisibility::Private => "private",
        }
    }
}

/// One declared API type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiType {
    pub name: String,

    #[serde(default)]
    pub kind: TypeKind,

    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,

    /// Enum values combine as bit flags
    #[serde(default)]
    pub flags: bool,

    /// Instance behavior is implemented on the managed side and reached
    /// from native code through trampolines
    #[serde(default)]
    pub managed_server: bool,

    /// Parent type; only honored when it names another API class
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,

    #[serde(default)]
    pub constructor: MemberVisibility,

    #[serde(default)]
    pub destructor: MemberVisibility,

    #[serde(default)]
    pub properties: Vec<ApiProperty>,

    #[serde(default)]
    pub methods: Vec<ApiMethod>,

    #[serde(default)]
    pub events: Vec<ApiEvent>,

    /// Struct fields (structs only)
    #[serde(default)]
    pub fields: Vec<ApiField>,

    /// Enum members (enums only)
    #[serde(default)]
    pub variants: Vec<EnumVariant>,
}

impl ApiType {
    /// A public, concrete, empty class.
    pub fn class(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Class,
            is_abstract: false,
            flags: false,
            managed_server: false,
            base: None,
            constructor: MemberVisibility::Public,
            destructor: MemberVisibility::Public,
            properties: Vec::new(),
            methods: Vec::new(),
            events: Vec::new(),
            fields: Vec::new(),
            variants: Vec::new(),
        }
    }

    pub fn is_class(&self) -> bool {
        self.kind == TypeKind::Class
    }

    pub fn is_struct(&self) -> bool {
        self.kind == TypeKind::Struct
    }

    pub fn is_enum(&self) -> bool {
        self.kind == TypeKind::Enum
    }

    pub fn is_flags_enum(&self) -> bool {
        self.is_enum() && self.flags
    }

    /// Enum members with their numeric values filled in.
    ///
    /// A member without an explicit value continues from the previous one:
    /// +1 for plain enums (starting at 0), doubling for flags enums
    /// (starting at 1). Fails when the continuation leaves the `i64` range.
    pub fn resolved_variants(&self) -> Result<Vec<(&str, i64)>, SchemaError> {
        let mut previous: Option<i64> = None;
        let mut resolved = Vec::with_capacity(self.variants.len());
        for variant in &self.variants {
            let value = match (variant.value, previous) {
                (Some(value), _) => Some(value),
                (None, None) => Some(if self.flags { 1 } else { 0 }),
                (None, Some(prev)) if self.flags => {
                    if prev <= 0 {
                        Some(1)
                    } else {
                        prev.checked_mul(2)
                    }
                }
                (None, Some(prev)) => prev.checked_add(1),
            };
            let value = value.ok_or_else(|| {
                SchemaError::ValidationError(format!(
                    "Enum {} member {} overflows a 64-bit value",
                    self.name, variant.name
                ))
            })?;
            previous = Some(value);
            resolved.push((variant.name.as_str(), value));
        }
        Ok(resolved)
    }
}

fn default_true() -> bool {
    true
}

/// A property with optional getter and setter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiProperty {
    pub name: String,

    #[serde(rename = "type")]
    pub ty: TypeRef,

    #[serde(default, rename = "static")]
    pub is_static: bool,

    #[serde(default = "default_true")]
    pub get: bool,

    #[serde(default)]
    pub set: bool,

    /// Filled in when the schema is loaded
    #[serde(skip)]
    pub declaring_type: String,
}

impl ApiProperty {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            is_static: false,
            get: true,
            set: false,
            declaring_type: String::new(),
        }
    }

    pub fn read_write(mut self) -> Self {
        self.set = true;
        self
    }
}

/// A method parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiParameter {
    pub name: String,

    #[serde(rename = "type")]
    pub ty: TypeRef,
}

impl ApiParameter {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// A method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiMethod {
    pub name: String,

    #[serde(default = "TypeRef::void")]
    pub returns: TypeRef,

    #[serde(default)]
    pub parameters: Vec<ApiParameter>,

    #[serde(default, rename = "static")]
    pub is_static: bool,

    /// Filled in when the schema is loaded
    #[serde(skip)]
    pub declaring_type: String,
}

impl ApiMethod {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            returns: TypeRef::Void,
            parameters: Vec::new(),
            is_static: false,
            declaring_type: String::new(),
        }
    }

    pub fn returning(mut self, ty: TypeRef) -> Self {
        self.returns = ty;
        self
    }

    pub fn param(mut self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.parameters.push(ApiParameter::new(name, ty));
        self
    }
}

/// An event raised by native code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEvent {
    pub name: String,

    /// Struct passed as the event payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<TypeRef>,

    /// The managed handler may cancel the native action
    #[serde(default)]
    pub cancellable: bool,
}

/// A struct field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiField {
    pub name: String,

    #[serde(rename = "type")]
    pub ty: TypeRef,
}

/// An enum member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumVariant {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variants(names: &[(&str, Option<i64>)]) -> Vec<EnumVariant> {
        names
            .iter()
            .map(|(name, value)| EnumVariant {
                name: name.to_string(),
                value: *value,
            })
            .collect()
    }

    #[test]
    fn test_plain_enum_values_continue() {
        let mut ty = ApiType::class("Alignment");
        ty.kind = TypeKind::Enum;
        ty.variants = variants(&[("Left", None), ("Center", None), ("Right", Some(10)), ("Fill", None)]);

        assert_eq!(
            ty.resolved_variants().unwrap(),
            vec![("Left", 0), ("Center", 1), ("Right", 10), ("Fill", 11)]
        );
    }

    #[test]
    fn test_flags_enum_values_double() {
        let mut ty = ApiType::class("Anchors");
        ty.kind = TypeKind::Enum;
        ty.flags = true;
        ty.variants = variants(&[("None", Some(0)), ("Left", None), ("Top", None), ("Right", None)]);

        assert!(ty.is_flags_enum());
        assert_eq!(
            ty.resolved_variants().unwrap(),
            vec![("None", 0), ("Left", 1), ("Top", 2), ("Right", 4)]
        );
    }

    #[test]
    fn test_flags_enum_past_bit_63_fails() {
        let mut ty = ApiType::class("Wide");
        ty.kind = TypeKind::Enum;
        ty.flags = true;
        let names: Vec<String> = (0..64).map(|i| format!("Bit{}", i)).collect();
        ty.variants = names
            .iter()
            .map(|name| EnumVariant {
                name: name.clone(),
                value: None,
            })
            .collect();

        match ty.resolved_variants() {
            Err(SchemaError::ValidationError(message)) => assert!(message.contains("Bit63"), "{}", message),
            other => panic!("expected overflow, got {:?}", other),
        }

        ty.variants.pop();
        let values = ty.resolved_variants().unwrap();
        assert_eq!(values.last(), Some(&("Bit62", 1i64 << 62)));
    }

    #[test]
    fn test_plain_enum_after_max_fails() {
        let mut ty = ApiType::class("Limits");
        ty.kind = TypeKind::Enum;
        ty.variants = variants(&[("Max", Some(i64::MAX)), ("Next", None)]);
        assert!(matches!(
            ty.resolved_variants(),
            Err(SchemaError::ValidationError(_))
        ));
    }

    #[test]
    fn test_flags_only_apply_to_enums() {
        let mut ty = ApiType::class("Widget");
        ty.flags = true;
        assert!(!ty.is_flags_enum());
    }
}
