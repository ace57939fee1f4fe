// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Symbolic type variables.
//!
//! A typevar names a type to be matched in a pattern. It has no storage: metadata,
//! printing and kernels all fail with [`Error::PatternType`].

use crate::config::EvalContext;
use crate::error::{Error, Result};
use crate::kernels::{AssignErrorMode, KernelBuilder, KernelRequest};
use crate::memblock::MemoryBlock;
use crate::types::extended::ExtendedDType;
use crate::types::metadata::Metadata;
use crate::types::type_id::{MemoryManagement, TypeId, TypeKind};
use crate::types::DType;
use std::any::Any;
use std::fmt;

#[derive(Debug, PartialEq, Eq)]
pub struct TypeVarDType {
    name: String,
}

impl TypeVarDType {
    /// `name` must be an identifier starting with an uppercase letter.
    pub fn new(name: &str) -> Result<Self> {
        let mut chars = name.chars();
        let valid = matches!(chars.next(), Some(c) if c.is_ascii_uppercase())
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(Error::Construction(format!(
                "typevar name '{}' must begin with an uppercase letter",
                name
            )));
        }
        Ok(Self {
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn refuse(&self, what: &str) -> Error {
        Error::PatternType(format!(
            "Cannot {} for symbolic type variable {}",
            what, self.name
        ))
    }
}

pub fn make_typevar_dtype(name: &str) -> Result<DType> {
    Ok(DType::new(TypeVarDType::new(name)?))
}

impl ExtendedDType for TypeVarDType {
    fn dtype_id(&self) -> TypeId {
        TypeId::Pattern
    }

    fn kind(&self) -> TypeKind {
        TypeKind::Pattern
    }

    fn alignment(&self) -> u8 {
        1
    }

    fn element_size(&self) -> usize {
        0
    }

    fn memory_management(&self) -> MemoryManagement {
        MemoryManagement::Pod
    }

    fn print_element(
        &self,
        _out: &mut dyn fmt::Write,
        _data: &[u8],
        _metadata: &Metadata,
    ) -> Result<()> {
        Err(self.refuse("print data"))
    }

    fn print_dtype(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        out.write_str(&self.name)
    }

    fn equals(&self, other: &dyn ExtendedDType) -> bool {
        other
            .as_any()
            .downcast_ref::<TypeVarDType>()
            .map_or(false, |o| o == self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn is_scalar(&self) -> bool {
        false
    }

    fn metadata_default_construct(&self, _shape: &[isize]) -> Result<Metadata> {
        Err(self.refuse("default construct metadata"))
    }

    fn metadata_copy_construct(
        &self,
        _src: &Metadata,
        _embedded_reference: Option<&MemoryBlock>,
    ) -> Result<Metadata> {
        Err(self.refuse("copy construct metadata"))
    }

    fn make_assignment_kernel(
        &self,
        _builder: &mut KernelBuilder,
        _offset: usize,
        _dst: &DType,
        _dst_meta: &Metadata,
        _src: &DType,
        _src_meta: &Metadata,
        _kernreq: KernelRequest,
        _errmode: AssignErrorMode,
        _ectx: &EvalContext,
    ) -> Result<usize> {
        Err(self.refuse("instantiate an assignment kernel"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::assign_element;
    use crate::types::make_dtype;

    #[test]
    fn test_name_rules() {
        assert_eq!(make_typevar_dtype("T").expect("typevar").to_string(), "T");
        assert!(make_typevar_dtype("Elem_2").is_ok());
        assert!(make_typevar_dtype("t").is_err());
        assert!(make_typevar_dtype("").is_err());
        assert!(make_typevar_dtype("T-1").is_err());
    }

    #[test]
    fn test_refuses_storage() {
        let t = make_typevar_dtype("T").expect("typevar");
        assert_eq!(t.kind(), TypeKind::Pattern);
        assert!(matches!(
            t.metadata_default_construct(&[]),
            Err(Error::PatternType(_))
        ));
        assert!(matches!(
            t.element_to_string(&[], &Metadata::None),
            Err(Error::PatternType(_))
        ));
        let mut dst = [0u8; 4];
        assert!(matches!(
            assign_element(
                &make_dtype::<i32>(),
                &Metadata::None,
                &mut dst,
                &t,
                &Metadata::None,
                &[],
                AssignErrorMode::None
            ),
            Err(Error::PatternType(_))
        ));
    }

    #[test]
    fn test_equality_by_name() {
        let a = make_typevar_dtype("T").expect("typevar");
        assert_eq!(a, make_typevar_dtype("T").expect("typevar"));
        assert_ne!(a, make_typevar_dtype("U").expect("typevar"));
    }
}
