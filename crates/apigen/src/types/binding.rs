//! C# spellings for `[DllImport]` declarations and unmanaged delegates

use super::{csharp_keyword, parameter_element, shape_of, Dialect, Position, Resolved, Shape, TypeResolver, TypeUsage};
use crate::error::{GenerateError, GenerateResult};
use crate::model::{ApiSchema, Primitive, TypeRef};

/// Resolver for the native-call binding dialect.
///
/// API classes cross the boundary as raw `IntPtr` handles. Text and booleans
/// carry explicit marshalling attributes in argument position. Array
/// parameters are blittable element arrays followed by a separate count.
pub struct BindingTypes<'s> {
    schema: &'s ApiSchema,
}

impl<'s> BindingTypes<'s> {
    pub fn new(schema: &'s ApiSchema) -> Self {
        Self { schema }
    }

    /// `[return: ...]` attribute a binding declaration needs for this type.
    pub fn return_attribute(&self, ty: &TypeRef) -> GenerateResult<Option<&'static str>> {
        Ok(match shape_of(self.schema, ty, Dialect::Binding)? {
            Shape::Primitive(Primitive::Bool) => Some("[return: MarshalAs(UnmanagedType.I1)]"),
            Shape::Text { .. } => Some("[return: MarshalAs(UnmanagedType.LPWStr)]"),
            _ => None,
        })
    }
}

impl TypeResolver for BindingTypes<'_> {
    fn dialect(&self) -> Dialect {
        Dialect::Binding
    }

    fn resolve(&self, ty: &TypeRef, usage: TypeUsage) -> GenerateResult<Resolved> {
        let position = usage.position();
        Ok(match shape_of(self.schema, ty, Dialect::Binding)? {
            Shape::Void => Resolved::plain("void"),
            Shape::Primitive(Primitive::Bool) if position == Position::Argument => {
                Resolved::plain("[MarshalAs(UnmanagedType.I1)] bool")
            }
            Shape::Primitive(p) => Resolved::plain(csharp_keyword(p)),
            Shape::Text { .. } if position == Position::Argument => {
                Resolved::plain("[MarshalAs(UnmanagedType.LPWStr)] string")
            }
            Shape::Text { .. } => Resolved::plain("string"),
            Shape::Struct(api) | Shape::Enum(api) => Resolved::plain(api.name.clone()),
            Shape::Class { ty: api, .. } => Resolved::with_include("IntPtr", api.name.clone()),
            Shape::NullableValue(_) => {
                return Err(GenerateError::unsupported(Dialect::Binding, "nullable value types", ty))
            }
            Shape::Array(element) => match position {
                Position::Argument => match parameter_element(&element, Dialect::Binding, ty)? {
                    Shape::Class { ty: api, .. } => Resolved::with_include("IntPtr[]", api.name.clone()),
                    Shape::Primitive(p) => Resolved::plain(format!("{}[]", csharp_keyword(*p))),
                    Shape::Struct(api) | Shape::Enum(api) => Resolved::plain(format!("{}[]", api.name)),
                    _ => return Err(GenerateError::unsupported(Dialect::Binding, "arrays", ty)),
                },
                Position::Return => {
                    return Err(GenerateError::unsupported(Dialect::Binding, "array return values", ty))
                }
                Position::Declaration => {
                    return Err(GenerateError::unsupported(Dialect::Binding, "array fields", ty))
                }
            },
        })
    }
}
