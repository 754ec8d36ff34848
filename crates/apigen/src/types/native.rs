//! C++ spellings for native class bodies

use super::{shape_of, Dialect, Position, Resolved, Shape, TypeResolver, TypeUsage};
use crate::error::{GenerateError, GenerateResult};
use crate::model::{ApiSchema, Primitive, TypeRef};

/// C++ spelling of a primitive; the C-ABI dialect reuses it except for `bool`.
pub(crate) fn cpp_primitive(primitive: Primitive) -> &'static str {
    match primitive {
        Primitive::Bool => "bool",
        Primitive::Byte => "uint8_t",
        Primitive::SByte => "int8_t",
        Primitive::Short => "int16_t",
        Primitive::UShort => "uint16_t",
        Primitive::Int => "int",
        Primitive::UInt => "unsigned int",
        Primitive::Long => "int64_t",
        Primitive::ULong => "uint64_t",
        Primitive::Float => "float",
        Primitive::Double => "double",
        Primitive::Char => "char16_t",
        Primitive::Pointer => "void*",
    }
}

/// Resolver for the native (C++) dialect.
///
/// Structs and text are taken by const reference as arguments and returned
/// by value. Classes are references outside declaration position, or
/// pointers when nullable. Nullable value types have no spelling here.
/// Arrays are `std::vector`s; class elements are stored as pointers.
pub struct NativeTypes<'s> {
    schema: &'s ApiSchema,
}

impl<'s> NativeTypes<'s> {
    pub fn new(schema: &'s ApiSchema) -> Self {
        Self { schema }
    }
}

impl TypeResolver for NativeTypes<'_> {
    fn dialect(&self) -> Dialect {
        Dialect::Native
    }

    fn resolve(&self, ty: &TypeRef, usage: TypeUsage) -> GenerateResult<Resolved> {
        let position = usage.position();
        Ok(match shape_of(self.schema, ty, Dialect::Native)? {
            Shape::Void => Resolved::plain("void"),
            Shape::Primitive(p) => Resolved::plain(cpp_primitive(p)),
            Shape::Text { .. } => match position {
                Position::Argument => Resolved::plain("const string&"),
                _ => Resolved::plain("string"),
            },
            Shape::Struct(api) => match position {
                Position::Argument => Resolved::plain(format!("const {}&", api.name)),
                _ => Resolved::plain(api.name.clone()),
            },
            Shape::Enum(api) => Resolved::plain(api.name.clone()),
            Shape::Class { ty: api, nullable } => {
                let literal = match (position, nullable) {
                    (Position::Declaration, _) => api.name.clone(),
                    (_, true) => format!("{}*", api.name),
                    (_, false) => format!("{}&", api.name),
                };
                Resolved::with_include(literal, format!("{}.h", api.name))
            }
            Shape::NullableValue(_) => {
                return Err(GenerateError::unsupported(Dialect::Native, "nullable value types", ty))
            }
            Shape::Array(element) => {
                let (element, include) = match *element {
                    Shape::Class { ty: api, .. } => (format!("{}*", api.name), Some(format!("{}.h", api.name))),
                    Shape::Primitive(p) => (cpp_primitive(p).to_string(), None),
                    Shape::Text { .. } => ("string".to_string(), None),
                    Shape::Struct(api) | Shape::Enum(api) => (api.name.clone(), None),
                    _ => return Err(GenerateError::unsupported(Dialect::Native, "arrays", ty)),
                };
                let literal = match position {
                    Position::Argument => format!("const std::vector<{}>&", element),
                    Position::Return => format!("std::vector<{}>", element),
                    Position::Declaration => {
                        return Err(GenerateError::unsupported(Dialect::Native, "array fields", ty))
                    }
                };
                Resolved { literal, include }
            }
        })
    }
}
