//! Trampoline slot table
//!
//! A managed-server type has its instance behavior implemented in managed
//! code. Native code reaches each overridable member through a trampoline
//! slot; both halves of the bridge number the slots identically. The slot
//! table below is the only place that order is computed.

use crate::error::{GenerateError, GenerateResult};
use crate::model::ApiType;
use crate::surface::{MemberRef, MemberSignature};
use crate::types::Dialect;

/// Accessor or method behind a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Getter,
    Setter,
    Method,
}

/// One numbered trampoline slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrampolineSlot {
    pub name: String,
    pub member: MemberRef,
    pub is_static: bool,
}

impl TrampolineSlot {
    pub fn kind(&self) -> SlotKind {
        match self.member {
            MemberRef::Getter(_) => SlotKind::Getter,
            MemberRef::Setter(_) => SlotKind::Setter,
            MemberRef::Method(_) => SlotKind::Method,
        }
    }

    pub fn signature<'a>(&self, ty: &'a ApiType) -> MemberSignature<'a> {
        self.member.signature(ty)
    }
}

/// Ordered slots of one managed-server type. The position of a slot is
/// its numeric value in both generated enumerations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotTable {
    type_name: String,
    slots: Vec<TrampolineSlot>,
}

impl SlotTable {
    /// Properties first (getter then setter), then methods, each in
    /// declaration order. Array members have no slot shape.
    pub fn derive(ty: &ApiType) -> GenerateResult<Self> {
        let mut slots: Vec<TrampolineSlot> = Vec::new();
        for member in MemberRef::walk(ty) {
            let signature = member.signature(ty);
            let array = std::iter::once(signature.returns)
                .chain(signature.params.iter().map(|(_, param)| *param))
                .find(|t| t.is_array());
            if let Some(array) = array {
                return Err(GenerateError::unsupported(Dialect::Native, "arrays in trampoline slots", array));
            }
            if slots.iter().any(|s| s.name == signature.name) {
                return Err(GenerateError::DuplicateSlot {
                    type_name: ty.name.clone(),
                    slot: signature.name,
                });
            }
            slots.push(TrampolineSlot {
                name: signature.name,
                member,
                is_static: signature.is_static,
            });
        }

        Ok(Self {
            type_name: ty.name.clone(),
            slots,
        })
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn slots(&self) -> &[TrampolineSlot] {
        &self.slots
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &TrampolineSlot)> {
        self.slots.iter().enumerate()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.slots.iter().map(|s| s.name.clone()).collect()
    }

    /// Compare the slot order an emitter actually produced
    pub fn verify(&self, artifact: &'static str, emitted: &[String]) -> GenerateResult<()> {
        let expected = self.names();
        if expected.as_slice() == emitted {
            Ok(())
        } else {
            Err(GenerateError::TrampolineOrderMismatch {
                type_name: self.type_name.clone(),
                artifact,
                expected,
                emitted: emitted.to_vec(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ApiMethod, ApiProperty, Primitive, TypeRef};

    fn widget() -> ApiType {
        let mut ty = ApiType::class("Widget");
        ty.managed_server = true;
        ty.methods.push(ApiMethod::new("Click"));
        ty.properties.push(ApiProperty::new("Text", TypeRef::Text).read_write());
        ty
    }

    #[test]
    fn test_properties_before_methods() {
        let table = SlotTable::derive(&widget()).unwrap();
        assert_eq!(table.names(), vec!["GetText", "SetText", "Click"]);
        let kinds: Vec<SlotKind> = table.slots().iter().map(|s| s.kind()).collect();
        assert_eq!(kinds, vec![SlotKind::Getter, SlotKind::Setter, SlotKind::Method]);
    }

    #[test]
    fn test_read_only_property_has_one_slot() {
        let mut ty = ApiType::class("Gauge");
        ty.properties.push(ApiProperty::new("Level", TypeRef::Primitive(Primitive::Float)));
        let table = SlotTable::derive(&ty).unwrap();
        assert_eq!(table.names(), vec!["GetLevel"]);
    }

    #[test]
    fn test_duplicate_slot_rejected() {
        let mut ty = widget();
        ty.methods.push(ApiMethod::new("GetText"));
        match SlotTable::derive(&ty) {
            Err(GenerateError::DuplicateSlot { type_name, slot }) => {
                assert_eq!(type_name, "Widget");
                assert_eq!(slot, "GetText");
            }
            other => panic!("expected duplicate slot, got {:?}", other),
        }
    }

    #[test]
    fn test_array_members_have_no_slot() {
        let mut ty = widget();
        ty.methods.push(ApiMethod::new("Plot").param("values", "int[]".parse().unwrap()));
        assert!(matches!(
            SlotTable::derive(&ty),
            Err(GenerateError::UnsupportedType { feature: "arrays in trampoline slots", .. })
        ));
    }

    #[test]
    fn test_verify_reports_divergence() {
        let table = SlotTable::derive(&widget()).unwrap();
        assert!(table.verify("managed enum", &table.names()).is_ok());

        let swapped = vec!["SetText".to_string(), "GetText".to_string(), "Click".to_string()];
        assert!(matches!(
            table.verify("native enum", &swapped),
            Err(GenerateError::TrampolineOrderMismatch { artifact: "native enum", .. })
        ));
    }
}
