// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The type handle.
//!
//! A [`DType`] is a small value: four cached scalar fields plus an optional shared
//! descriptor. Builtin handles carry no descriptor and never allocate; cloning one
//! is a plain copy of its fields. Descriptor-backed handles hold one strong count
//! each on an `Arc<dyn ExtendedDType>`.

use crate::error::{Error, Result};
use crate::types::builtin::{print_builtin_element, Scalar};
use crate::types::encoding::StringEncoding;
use crate::types::extended::{ExpressionDType, ExtendedDType};
use crate::types::iterdata::IterData;
use crate::types::metadata::Metadata;
use crate::types::type_id::{
    MemoryManagement, TypeId, TypeKind, BUILTIN_LAYOUTS, BUILTIN_TYPE_ID_COUNT,
};
use crate::memblock::MemoryBlock;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Runtime type handle.
#[derive(Clone)]
pub struct DType {
    type_id: TypeId,
    kind: TypeKind,
    alignment: u8,
    element_size: usize,
    extended: Option<Arc<dyn ExtendedDType>>,
}

const fn builtin_row(type_id: TypeId) -> DType {
    let layout = BUILTIN_LAYOUTS[type_id as usize];
    DType {
        type_id,
        kind: layout.kind,
        alignment: layout.alignment,
        element_size: layout.element_size,
        extended: None,
    }
}

static BUILTIN_DTYPES: [DType; BUILTIN_TYPE_ID_COUNT] = [
    builtin_row(TypeId::Bool),
    builtin_row(TypeId::Int8),
    builtin_row(TypeId::Int16),
    builtin_row(TypeId::Int32),
    builtin_row(TypeId::Int64),
    builtin_row(TypeId::UInt8),
    builtin_row(TypeId::UInt16),
    builtin_row(TypeId::UInt32),
    builtin_row(TypeId::UInt64),
    builtin_row(TypeId::Float32),
    builtin_row(TypeId::Float64),
    builtin_row(TypeId::Complex64),
    builtin_row(TypeId::Complex128),
    builtin_row(TypeId::Void),
];

/// Handle for the builtin scalar `T`.
pub fn make_dtype<T: Scalar>() -> DType {
    BUILTIN_DTYPES[T::TYPE_ID as usize].clone()
}

impl DType {
    /// Handle for a builtin type id.
    pub fn builtin(type_id: TypeId) -> Result<DType> {
        Self::static_builtin(type_id).cloned()
    }

    /// Shared static handle for a builtin type id.
    pub fn static_builtin(type_id: TypeId) -> Result<&'static DType> {
        if !type_id.is_builtin() {
            return Err(Error::InvalidTypeId(type_id as u8));
        }
        Ok(&BUILTIN_DTYPES[type_id as usize])
    }

    /// Wraps a descriptor, taking over the caller's strong count.
    pub fn from_extended(extended: Arc<dyn ExtendedDType>) -> DType {
        DType {
            type_id: extended.dtype_id(),
            kind: extended.kind(),
            alignment: extended.alignment(),
            element_size: extended.element_size(),
            extended: Some(extended),
        }
    }

    /// Wraps a descriptor the caller keeps; the handle takes its own count.
    pub fn from_shared(extended: &Arc<dyn ExtendedDType>) -> DType {
        Self::from_extended(Arc::clone(extended))
    }

    pub fn new<T: ExtendedDType>(descriptor: T) -> DType {
        Self::from_extended(Arc::new(descriptor))
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn alignment(&self) -> u8 {
        self.alignment
    }

    /// Fixed element size in bytes; 0 for void and metadata-sized types.
    pub fn element_size(&self) -> usize {
        self.element_size
    }

    pub fn is_builtin(&self) -> bool {
        self.extended.is_none()
    }

    pub fn is_expression(&self) -> bool {
        self.kind == TypeKind::Expression
    }

    /// True when elements can be copied with memcpy.
    pub fn is_pod(&self) -> bool {
        self.element_size > 0 && self.memory_management() == MemoryManagement::Pod
    }

    pub fn memory_management(&self) -> MemoryManagement {
        match &self.extended {
            Some(ext) => ext.memory_management(),
            None => MemoryManagement::Pod,
        }
    }

    pub fn extended(&self) -> Option<&Arc<dyn ExtendedDType>> {
        self.extended.as_ref()
    }

    /// The descriptor downcast to its concrete type.
    pub fn extended_as<T: ExtendedDType>(&self) -> Option<&T> {
        self.extended
            .as_deref()
            .and_then(|ext| ext.as_any().downcast_ref::<T>())
    }

    /// The expression capability, present only for expression-kind types.
    pub fn expression(&self) -> Option<&dyn ExpressionDType> {
        if self.kind != TypeKind::Expression {
            return None;
        }
        self.extended.as_deref().and_then(|ext| ext.as_expression())
    }

    /// Strong count on the descriptor, `None` for builtins.
    pub fn use_count(&self) -> Option<usize> {
        self.extended.as_ref().map(Arc::strong_count)
    }

    // --- Expression chain ---

    /// Semantic type; the type itself unless it is an expression.
    pub fn value_type(&self) -> &DType {
        match self.expression() {
            Some(expr) => expr.value_type(),
            None => self,
        }
    }

    /// One link down an expression chain; the type itself otherwise.
    pub fn operand_type(&self) -> &DType {
        match self.expression() {
            Some(expr) => expr.operand_type(),
            None => self,
        }
    }

    /// Bottom of the expression chain. Never of expression kind.
    pub fn storage_type(&self) -> &DType {
        let mut current = self;
        while let Some(expr) = current.expression() {
            current = expr.operand_type();
        }
        current
    }

    /// Rounds `offset` up to this type's alignment.
    pub fn inc_to_alignment(&self, offset: usize) -> usize {
        let align = self.alignment.max(1) as usize;
        (offset + align - 1) & !(align - 1)
    }

    pub fn string_encoding(&self) -> Option<StringEncoding> {
        self.extended
            .as_deref()
            .and_then(|ext| ext.as_string())
            .map(|s| s.encoding())
    }

    // --- Shape ---

    pub fn ndim(&self) -> usize {
        self.extended.as_ref().map_or(0, |ext| ext.ndim())
    }

    pub fn is_scalar(&self) -> bool {
        self.extended.as_ref().map_or(true, |ext| ext.is_scalar())
    }

    pub fn shape(&self, metadata: Option<&Metadata>) -> Vec<isize> {
        self.extended
            .as_ref()
            .map_or_else(Vec::new, |ext| ext.get_shape(metadata))
    }

    pub fn strides(&self, metadata: Option<&Metadata>) -> Vec<isize> {
        self.extended
            .as_ref()
            .map_or_else(Vec::new, |ext| ext.get_strides(metadata))
    }

    /// Element size of a default-constructed instance with the given shape.
    pub fn default_element_size(&self, shape: &[isize]) -> usize {
        match &self.extended {
            Some(ext) => ext.default_element_size(shape),
            None => self.element_size,
        }
    }

    // --- Printing ---

    pub fn print_element(
        &self,
        out: &mut dyn fmt::Write,
        data: &[u8],
        metadata: &Metadata,
    ) -> Result<()> {
        match &self.extended {
            Some(ext) => ext.print_element(out, data, metadata),
            None => print_builtin_element(self.type_id, out, data),
        }
    }

    pub fn element_to_string(&self, data: &[u8], metadata: &Metadata) -> Result<String> {
        let mut out = String::new();
        self.print_element(&mut out, data, metadata)?;
        Ok(out)
    }

    // --- Metadata lifecycle ---

    pub fn metadata_default_construct(&self, shape: &[isize]) -> Result<Metadata> {
        match &self.extended {
            Some(ext) => ext.metadata_default_construct(shape),
            None => Ok(Metadata::None),
        }
    }

    pub fn metadata_copy_construct(
        &self,
        src: &Metadata,
        embedded_reference: Option<&MemoryBlock>,
    ) -> Result<Metadata> {
        match &self.extended {
            Some(ext) => ext.metadata_copy_construct(src, embedded_reference),
            None => Ok(Metadata::None),
        }
    }

    pub fn metadata_destruct(&self, metadata: &mut Metadata) {
        match &self.extended {
            Some(ext) => ext.metadata_destruct(metadata),
            None => *metadata = Metadata::None,
        }
    }

    pub fn metadata_debug_dump(
        &self,
        metadata: &Metadata,
        out: &mut dyn fmt::Write,
        indent: &str,
    ) -> fmt::Result {
        match &self.extended {
            Some(ext) => ext.metadata_debug_dump(metadata, out, indent),
            None => Ok(()),
        }
    }

    // --- Iteration data ---

    pub fn iterdata_construct(&self, metadata: &Metadata) -> Result<IterData> {
        match &self.extended {
            Some(ext) => ext.iterdata_construct(metadata),
            None => Ok(IterData::default()),
        }
    }

    pub fn iterdata_destruct(&self, iterdata: &mut IterData) {
        match &self.extended {
            Some(ext) => ext.iterdata_destruct(iterdata),
            None => iterdata.clear(),
        }
    }
}

impl Default for DType {
    fn default() -> Self {
        builtin_row(TypeId::Void)
    }
}

impl PartialEq for DType {
    fn eq(&self, other: &Self) -> bool {
        match (&self.extended, &other.extended) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b) || a.equals(b.as_ref()),
            (None, None) => {
                self.type_id == other.type_id
                    && self.kind == other.kind
                    && self.alignment == other.alignment
                    && self.element_size == other.element_size
            }
            _ => false,
        }
    }
}

impl Eq for DType {}

impl From<TypeId> for DType {
    /// Builtin ids map to their handle; other ids yield `void`.
    fn from(type_id: TypeId) -> Self {
        DType::builtin(type_id).unwrap_or_default()
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.extended {
            Some(ext) => ext.print_dtype(f),
            None => f.write_str(self.type_id.name()),
        }
    }
}

impl fmt::Debug for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DType({})", self)
    }
}

impl FromStr for DType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        crate::types::parse::parse_dtype(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::builtin::Complex;

    #[test]
    fn test_builtin_handles_have_no_descriptor() {
        let a = DType::builtin(TypeId::Int32).expect("builtin");
        let b = make_dtype::<i32>();
        assert_eq!(a, b);
        assert!(a.extended().is_none());
        assert!(a.use_count().is_none());
        assert_eq!(a.element_size(), 4);
        assert_eq!(a.kind(), TypeKind::Int);
        assert_eq!(a.to_string(), "int32");
    }

    #[test]
    fn test_non_builtin_id_rejected() {
        assert!(matches!(
            DType::builtin(TypeId::Struct),
            Err(Error::InvalidTypeId(id)) if id == TypeId::Struct as u8
        ));
    }

    #[test]
    fn test_complex_and_void() {
        let c = make_dtype::<Complex<f32>>();
        assert_eq!(c.alignment(), 4);
        assert_eq!(c.element_size(), 8);
        assert_eq!(c.to_string(), "complex<float32>");

        let v = DType::default();
        assert_eq!(v.type_id(), TypeId::Void);
        assert!(!v.is_pod());
    }

    #[test]
    fn test_chain_identity_for_non_expressions() {
        let t = make_dtype::<f64>();
        assert_eq!(t.value_type(), &t);
        assert_eq!(t.operand_type(), &t);
        assert_eq!(t.storage_type(), &t);
        assert!(t.expression().is_none());
    }

    #[test]
    fn test_inc_to_alignment() {
        let t = make_dtype::<i64>();
        assert_eq!(t.inc_to_alignment(0), 0);
        assert_eq!(t.inc_to_alignment(1), 8);
        assert_eq!(t.inc_to_alignment(9), 16);
    }

    #[test]
    fn test_print_builtin_element() {
        let t = make_dtype::<i16>();
        let text = t
            .element_to_string(&(-7i16).to_ne_bytes(), &Metadata::None)
            .expect("print");
        assert_eq!(text, "-7");
    }
}
