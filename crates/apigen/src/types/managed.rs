//! C# spellings for wrapper classes

use super::{shape_of, Dialect, Position, Resolved, Shape, TypeResolver, TypeUsage};
use crate::error::GenerateResult;
use crate::model::{ApiSchema, Primitive, TypeRef};

/// C# keyword for a primitive; shared with the binding dialect.
pub(crate) fn csharp_keyword(primitive: Primitive) -> &'static str {
    match primitive {
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
        Primitive::Pointer => "IntPtr",
    }
}

/// Resolver for the managed wrapper dialect.
///
/// API classes are ordinary (strong) object references here; nullability
/// is carried by the `?` annotation. Arrays keep their managed element type.
pub struct ManagedTypes<'s> {
    schema: &'s ApiSchema,
}

impl<'s> ManagedTypes<'s> {
    pub fn new(schema: &'s ApiSchema) -> Self {
        Self { schema }
    }

    fn spell(&self, shape: &Shape<'_>, position: Position) -> Resolved {
        match shape {
            Shape::Void => Resolved::plain("void"),
            Shape::Primitive(p) => Resolved::plain(csharp_keyword(*p)),
            Shape::Text { nullable } => {
                if *nullable && position != Position::Declaration {
                    Resolved::plain("string?")
                } else {
                    Resolved::plain("string")
                }
            }
            Shape::Struct(ty) | Shape::Enum(ty) => Resolved::plain(ty.name.clone()),
            Shape::Class { ty, nullable } => {
                let literal = if *nullable && position != Position::Declaration {
                    format!("{}?", ty.name)
                } else {
                    ty.name.clone()
                };
                Resolved::with_include(literal, ty.name.clone())
            }
            Shape::NullableValue(inner) => {
                let inner = self.spell(inner, position);
                Resolved::plain(format!("{}?", inner.literal))
            }
            Shape::Array(element) => {
                let element = self.spell(element, Position::Declaration);
                Resolved {
                    literal: format!("{}[]", element.literal),
                    include: element.include,
                }
            }
        }
    }
}

impl TypeResolver for ManagedTypes<'_> {
    fn dialect(&self) -> Dialect {
        Dialect::Managed
    }

    fn resolve(&self, ty: &TypeRef, usage: TypeUsage) -> GenerateResult<Resolved> {
        let shape = shape_of(self.schema, ty, Dialect::Managed)?;
        Ok(self.spell(&shape, usage.position()))
    }
}
