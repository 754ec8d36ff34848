//! C spellings for the flat ABI shim

use super::native::cpp_primitive;
use super::{parameter_element, shape_of, Dialect, Position, Resolved, Shape, TypeResolver, TypeUsage};
use crate::error::{GenerateError, GenerateResult};
use crate::model::{ApiSchema, Primitive, TypeRef};

/// Resolver for the C-ABI dialect.
///
/// Text is a 16-bit character pointer; returned text is allocated by the
/// native side with `AllocInteropString`. Classes are opaque pointers,
/// structs always travel by value. An array parameter is a pointer to its
/// first element; the shim takes the count as a separate `int`.
pub struct CAbiTypes<'s> {
    schema: &'s ApiSchema,
}

impl<'s> CAbiTypes<'s> {
    pub fn new(schema: &'s ApiSchema) -> Self {
        Self { schema }
    }
}

impl TypeResolver for CAbiTypes<'_> {
    fn dialect(&self) -> Dialect {
        Dialect::CAbi
    }

    fn resolve(&self, ty: &TypeRef, usage: TypeUsage) -> GenerateResult<Resolved> {
        let position = usage.position();
        Ok(match shape_of(self.schema, ty, Dialect::CAbi)? {
            Shape::Void => Resolved::plain("void"),
            Shape::Primitive(Primitive::Bool) => Resolved::plain("c_bool"),
            Shape::Primitive(p) => Resolved::plain(cpp_primitive(p)),
            Shape::Text { .. } => match position {
                Position::Argument => Resolved::plain("const char16_t*"),
                _ => Resolved::plain("char16_t*"),
            },
            Shape::Struct(api) | Shape::Enum(api) => Resolved::plain(api.name.clone()),
            Shape::Class { ty: api, .. } => {
                let literal = match position {
                    Position::Declaration => api.name.clone(),
                    _ => format!("{}*", api.name),
                };
                Resolved::with_include(literal, format!("{}.h", api.name))
            }
            Shape::NullableValue(_) => {
                return Err(GenerateError::unsupported(Dialect::CAbi, "nullable value types", ty))
            }
            Shape::Array(element) => match position {
                Position::Argument => match parameter_element(&element, Dialect::CAbi, ty)? {
                    Shape::Class { ty: api, .. } => {
                        Resolved::with_include(format!("{}**", api.name), format!("{}.h", api.name))
                    }
                    Shape::Primitive(p) => Resolved::plain(format!("const {}*", cpp_primitive(*p))),
                    Shape::Struct(api) | Shape::Enum(api) => Resolved::plain(format!("const {}*", api.name)),
                    _ => return Err(GenerateError::unsupported(Dialect::CAbi, "arrays", ty)),
                },
                Position::Return => return Err(GenerateError::unsupported(Dialect::CAbi, "array return values", ty)),
                Position::Declaration => return Err(GenerateError::unsupported(Dialect::CAbi, "array fields", ty)),
            },
        })
    }
}
