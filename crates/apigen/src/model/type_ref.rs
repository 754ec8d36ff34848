//! Type references as written in the schema (`"int"`, `"PointI"`, `"Control?"`)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::SchemaError;

/// Built-in value types with a fixed-width representation in every dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Bool,
    Byte,
    SByte,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    Float,
    Double,
    Char,
    /// Opaque native pointer (`IntPtr` / `void*`)
    Pointer,
}

impl Primitive {
    const ALL: [Primitive; 13] = [
        Primitive::Bool,
        Primitive::Byte,
        Primitive::SByte,
        Primitive::Short,
        Primitive::UShort,
        Primitive::Int,
        Primitive::UInt,
        Primitive::Long,
        Primitive::ULong,
        Primitive::Float,
        Primitive::Double,
        Primitive::Char,
        Primitive::Pointer,
    ];

    /// The spelling used in schema files.
    pub fn keyword(self) -> &'static str {
        match self {
            Primitive::Bool => "bool",
            Primitive::Byte => "byte",
            Primitive::SByte => "sbyte",
            Primitive::Short => "short",
            Primitive::UShort => "ushort",
            Primitive::Int => "int",
            Primitive::UInt => "uint",
            Primitive::Long => "long",
            Primitive::ULong => "ulong",
            Primitive::Float => "float",
            Primitive::Double => "double",
            Primitive::Char => "char",
            Primitive::Pointer => "pointer",
        }
    }

    fn from_keyword(text: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.keyword() == text)
    }
}

/// A reference to a type from a member signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TypeRef {
    Void,
    Primitive(Primitive),
    /// UTF-16 text
    Text,
    /// An API type declared in the schema (class, struct or enum)
    Named(String),
    Nullable(Box<TypeRef>),
    Array(Box<TypeRef>),
    /// Generic instantiation such as `List<int>`; kept verbatim
    Generic(String),
}

impl TypeRef {
    pub fn void() -> Self {
        TypeRef::Void
    }

    pub fn named(name: impl Into<String>) -> Self {
        TypeRef::Named(name.into())
    }

    pub fn nullable(inner: TypeRef) -> Self {
        TypeRef::Nullable(Box::new(inner))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, TypeRef::Void)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, TypeRef::Array(_))
    }

    /// The referenced API type name, looking through `?`.
    pub fn api_name(&self) -> Option<&str> {
        match self {
            TypeRef::Named(name) => Some(name),
            TypeRef::Nullable(inner) => inner.api_name(),
            _ => None,
        }
    }
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl FromStr for TypeRef {
    type Err = SchemaError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let text = text.trim();
        let invalid = |reason: &str| SchemaError::InvalidTypeRef {
            text: text.to_string(),
            reason: reason.to_string(),
        };

        if text.is_empty() {
            return Err(invalid("empty type"));
        }

        if let Some(inner) = text.strip_suffix('?') {
            let inner: TypeRef = inner.parse()?;
            return match inner {
                TypeRef::Nullable(_) => Err(invalid("nested nullable")),
                TypeRef::Void => Err(invalid("void cannot be nullable")),
                other => Ok(TypeRef::nullable(other)),
            };
        }

        if let Some(inner) = text.strip_suffix("[]") {
            let inner: TypeRef = inner.parse()?;
            if inner.is_void() {
                return Err(invalid("array of void"));
            }
            return Ok(TypeRef::Array(Box::new(inner)));
        }

        if let Some(open) = text.find('<') {
            if !text.ends_with('>') || !is_identifier(&text[..open]) {
                return Err(invalid("malformed generic arguments"));
            }
            return Ok(TypeRef::Generic(text.to_string()));
        }

        match text {
            "void" => Ok(TypeRef::Void),
            "string" => Ok(TypeRef::Text),
            _ => {
                if let Some(primitive) = Primitive::from_keyword(text) {
                    Ok(TypeRef::Primitive(primitive))
                } else if is_identifier(text) {
                    Ok(TypeRef::Named(text.to_string()))
                } else {
                    Err(invalid("not an identifier"))
                }
            }
        }
    }
}

impl TryFrom<String> for TypeRef {
    type Error = SchemaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TypeRef> for String {
    fn from(value: TypeRef) -> Self {
        value.to_string()
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Void => f.write_str("void"),
            TypeRef::Primitive(p) => f.write_str(p.keyword()),
            TypeRef::Text => f.write_str("string"),
            TypeRef::Named(name) => f.write_str(name),
            TypeRef::Nullable(inner) => write!(f, "{}?", inner),
            TypeRef::Array(inner) => write!(f, "{}[]", inner),
            TypeRef::Generic(text) => f.write_str(text),
        }
    }
}
