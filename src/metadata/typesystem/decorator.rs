//! Decorator chains: arrays, pointers, by-refs and `Nullable<T>` around an element type.

use std::sync::Arc;

use crate::{
    metadata::{
        handle::TypeHandle,
        typesystem::{Type, TypeKind, TypeModifier, TypeRc, MAX_CHAIN_DEPTH},
    },
    Error, Result,
};

impl Type {
    /// The wrapper of a decorator type
    #[must_use]
    pub fn modifier(&self) -> Option<TypeModifier> {
        match self.kind {
            TypeKind::Decorator(modifier) => Some(modifier),
            _ => None,
        }
    }

    fn element_handle(&self) -> Option<&TypeHandle> {
        match &self.handle {
            TypeHandle::Array { element, .. }
            | TypeHandle::Pointer(element)
            | TypeHandle::ByRef(element) => Some(element),
            TypeHandle::Instance { arguments, .. }
                if self.kind == TypeKind::Decorator(TypeModifier::Nullable) =>
            {
                arguments.first()
            }
            _ => None,
        }
    }

    /// The type one decorator layer down
    #[must_use]
    pub fn element_type(&self) -> Option<TypeRc> {
        self.resolve(self.element_handle()?)
    }

    /// Returns true for every type that is not a decorator
    #[must_use]
    pub fn is_direct_declaration(&self) -> bool {
        self.modifier().is_none()
    }

    /// Strips every decorator layer: `int?[]&` unwraps to `int`.
    #[must_use]
    pub fn unwrap(self: &Arc<Self>) -> TypeRc {
        self.unwrap_with(|_| {})
    }

    /// Strips every decorator layer, calling `visitor` with each layer, outermost first.
    pub fn unwrap_with(self: &Arc<Self>, mut visitor: impl FnMut(&Type)) -> TypeRc {
        let mut current = self.clone();
        for _ in 0..MAX_CHAIN_DEPTH {
            if current.is_direct_declaration() {
                break;
            }
            visitor(&current);
            match current.element_type() {
                Some(element) => current = element,
                None => break,
            }
        }
        current
    }

    fn decorate(&self, handle: TypeHandle) -> Result<TypeRc> {
        let provider = self.inner().ok_or(Error::Unloaded)?;
        provider.get_type(&handle)
    }

    fn check_element(&self, what: &str) -> Result<()> {
        if self.kind == TypeKind::Decorator(TypeModifier::ByRef) {
            return Err(Error::InvalidArgument(format!(
                "{what} of the by-ref type {} is not a valid type",
                self.full_name()
            )));
        }
        Ok(())
    }

    /// An array of this type; rank 0 is the vector `T[]`, any other rank a multi-dimensional
    /// array (`T[,]` for rank 2).
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] for arrays of by-ref types.
    pub fn make_array_type(&self, rank: u32) -> Result<TypeRc> {
        self.check_element("An array")?;
        self.decorate(TypeHandle::Array {
            element: Box::new(self.handle.clone()),
            rank,
        })
    }

    /// An unmanaged pointer to this type.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] for pointers to by-ref types.
    pub fn make_pointer_type(&self) -> Result<TypeRc> {
        self.check_element("A pointer")?;
        self.decorate(TypeHandle::Pointer(Box::new(self.handle.clone())))
    }

    /// A managed reference to this type.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] for references to by-ref types.
    pub fn make_by_ref_type(&self) -> Result<TypeRc> {
        self.check_element("A reference")?;
        self.decorate(TypeHandle::ByRef(Box::new(self.handle.clone())))
    }

    /// `Nullable<T>` over this value type.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] for reference types and for types that already are
    /// nullable.
    pub fn make_nullable_type(&self) -> Result<TypeRc> {
        if !self.is_value_type() || self.kind == TypeKind::Decorator(TypeModifier::Nullable) {
            return Err(Error::InvalidArgument(format!(
                "{} can not be made nullable",
                self.full_name()
            )));
        }
        let provider = self.inner().ok_or(Error::Unloaded)?;
        let definition = provider.core_definition("System", "Nullable`1")?;
        self.decorate(TypeHandle::Instance {
            definition: Box::new(definition),
            arguments: vec![self.handle.clone()],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::provider::MetadataProvider;

    #[test]
    fn nested_layers() {
        let provider = MetadataProvider::new();
        let int = provider.find_type_by_full_name("System.Int32").unwrap();

        let nullable = int.make_nullable_type().unwrap();
        let pointer = nullable.make_pointer_type().unwrap();
        let array = pointer.make_array_type(0).unwrap();
        let by_ref = array.make_by_ref_type().unwrap();

        assert_eq!(by_ref.modifier(), Some(TypeModifier::ByRef));
        assert_eq!(nullable.modifier(), Some(TypeModifier::Nullable));
        assert!(!by_ref.is_direct_declaration());
        assert!(int.is_direct_declaration());
        assert_eq!(array.element_type().unwrap(), pointer);
        assert_eq!(nullable.element_type().unwrap(), int);
        assert_eq!(by_ref.full_name(), "System.Nullable`1[System.Int32]*[]&");

        let mut layers = Vec::new();
        let unwrapped = by_ref.unwrap_with(|layer| layers.push(layer.modifier()));
        assert_eq!(unwrapped, int);
        assert_eq!(
            layers,
            [
                Some(TypeModifier::ByRef),
                Some(TypeModifier::Array(0)),
                Some(TypeModifier::Pointer),
                Some(TypeModifier::Nullable),
            ]
        );
        assert_eq!(int.unwrap(), int);
    }

    #[test]
    fn invalid_decorations() {
        let provider = MetadataProvider::new();
        let int = provider.find_type_by_full_name("System.Int32").unwrap();
        let string = provider.find_type_by_full_name("System.String").unwrap();
        let by_ref = int.make_by_ref_type().unwrap();

        assert!(matches!(by_ref.make_by_ref_type(), Err(Error::InvalidArgument(_))));
        assert!(matches!(by_ref.make_array_type(0), Err(Error::InvalidArgument(_))));
        assert!(matches!(string.make_nullable_type(), Err(Error::InvalidArgument(_))));
        assert!(matches!(
            int.make_nullable_type().unwrap().make_nullable_type(),
            Err(Error::InvalidArgument(_))
        ));

        let matrix = int.make_array_type(2).unwrap();
        assert_eq!(matrix.name(), "Int32[,]");
        assert_ne!(matrix, int.make_array_type(0).unwrap());
        assert_eq!(matrix.base_type().unwrap().full_name(), "System.Array");
    }
}
