//! Structural equality of raw handles.
//!
//! The same logical type can be reached through different paths: a `TypeRef` in one module and the
//! `TypeDef` it binds to, a generic parameter as seen from a nested type and as declared on its
//! enclosing type, or `Box<T>` spelled as an instance over its own parameters. Canonicalization
//! maps all of these to one handle, after which the derived `Eq`/`Hash` of the handle types are
//! the structural equality and hash.
//!
//! Canonical form:
//! - references are bound to their definition, or to a [`TypeHandle::Named`] if the defining
//!   assembly is not resident;
//! - a type-level generic parameter is owned by the nesting level that declares it;
//! - an instance whose arguments are the definition's own parameters is the definition;
//! - a generic method instantiated over its own parameters is the method definition.

use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

use crate::metadata::{
    handle::{GenericOwner, Handle, MemberHandle, MethodHandle, ParameterHandle, TypeHandle},
    module::{ModuleId, ModuleRc},
    provider::ProviderInner,
    tables::TableId,
    token::Token,
};

impl ProviderInner {
    /// Canonical form of any handle
    pub(crate) fn canonical(&self, handle: &Handle) -> Handle {
        match handle {
            Handle::Type(handle) => Handle::Type(self.canonical_type(handle)),
            Handle::Method(handle) => Handle::Method(self.canonical_method(handle)),
            Handle::Field(handle) => Handle::Field(self.canonical_member(handle)),
            Handle::Property(handle) => Handle::Property(self.canonical_member(handle)),
            Handle::Event(handle) => Handle::Event(self.canonical_member(handle)),
            Handle::Parameter(handle) => Handle::Parameter(ParameterHandle {
                method: self.canonical_method(&handle.method),
                position: handle.position,
            }),
        }
    }

    pub(crate) fn canonical_type(&self, handle: &TypeHandle) -> TypeHandle {
        match handle {
            TypeHandle::Reference { module, row } => match self.module(*module) {
                Ok(owner) => self
                    .resolve_type_ref(&owner, *row)
                    .unwrap_or_else(|| handle.clone()),
                Err(_) => handle.clone(),
            },
            TypeHandle::Named {
                assembly,
                full_name,
            } => self.bind_named(assembly, full_name),
            TypeHandle::Instance {
                definition,
                arguments,
            } => {
                let definition = self.canonical_type(definition);
                let arguments: Vec<TypeHandle> =
                    arguments.iter().map(|a| self.canonical_type(a)).collect();
                if let TypeHandle::Definition { module, row } = &definition {
                    if let Ok(owner) = self.module(*module) {
                        if arguments == self.own_parameters(&owner, *row) {
                            return definition;
                        }
                    }
                }
                TypeHandle::Instance {
                    definition: Box::new(definition),
                    arguments,
                }
            }
            TypeHandle::Parameter {
                owner: GenericOwner::Type { module, row },
                number,
            } => TypeHandle::Parameter {
                owner: GenericOwner::Type {
                    module: *module,
                    row: self.declaring_level(*module, *row, *number),
                },
                number: *number,
            },
            TypeHandle::Array { element, rank } => TypeHandle::Array {
                element: Box::new(self.canonical_type(element)),
                rank: *rank,
            },
            TypeHandle::Pointer(element) => {
                TypeHandle::Pointer(Box::new(self.canonical_type(element)))
            }
            TypeHandle::ByRef(element) => TypeHandle::ByRef(Box::new(self.canonical_type(element))),
            other => other.clone(),
        }
    }

    pub(crate) fn canonical_method(&self, handle: &MethodHandle) -> MethodHandle {
        let arguments: Vec<TypeHandle> = handle
            .arguments
            .iter()
            .map(|a| self.canonical_type(a))
            .collect();
        let own = self.module(handle.module).ok().map(|module| {
            let count = module
                .generic_params(Token::from_parts(TableId::MethodDef, handle.row))
                .len();
            method_parameters(&module, handle.row, count)
        });

        MethodHandle {
            declaring: self.canonical_type(&handle.declaring),
            module: handle.module,
            row: handle.row,
            arguments: if own.as_ref() == Some(&arguments) {
                Vec::new()
            } else {
                arguments
            },
        }
    }

    fn canonical_member(&self, handle: &MemberHandle) -> MemberHandle {
        MemberHandle {
            declaring: self.canonical_type(&handle.declaring),
            module: handle.module,
            row: handle.row,
        }
    }

    /// The canonical parameters of the TypeDef `row`, across all nesting levels
    pub(crate) fn own_parameters(&self, module: &ModuleRc, row: u32) -> Vec<TypeHandle> {
        #[allow(clippy::cast_possible_truncation)]
        let count = module
            .generic_params(Token::from_parts(TableId::TypeDef, row))
            .len() as u32;
        (0..count)
            .map(|number| TypeHandle::Parameter {
                owner: GenericOwner::Type {
                    module: module.id(),
                    row: self.declaring_level(module.id(), row, number),
                },
                number,
            })
            .collect()
    }

    /// The outermost type in the enclosing chain of `row` that still declares parameter `number`
    fn declaring_level(&self, module: ModuleId, row: u32, number: u32) -> u32 {
        let Ok(owner) = self.module(module) else {
            return row;
        };

        let mut current = row;
        while let Some(enclosing) = owner.enclosing_type(current) {
            let count = owner
                .generic_params(Token::from_parts(TableId::TypeDef, enclosing))
                .len();
            if (number as usize) < count {
                current = enclosing;
            } else {
                break;
            }
        }
        current
    }
}

/// Handles of the generic parameters of the MethodDef `row`
pub(crate) fn method_parameters(module: &ModuleRc, row: u32, count: usize) -> Vec<TypeHandle> {
    let count = u32::try_from(count).unwrap_or(u32::MAX);
    (0..count)
        .map(|number| TypeHandle::Parameter {
            owner: GenericOwner::Method {
                module: module.id(),
                row,
            },
            number,
        })
        .collect()
}

/// Equality and hashing of raw handles by the logical entity they denote.
///
/// Obtained from [`crate::metadata::provider::MetadataProvider::comparer`]; binding references
/// uses the modules registered with that provider.
///
/// ```rust,no_run
/// use dotdoc::prelude::*;
///
/// let provider = MetadataProvider::new();
/// let object = provider.find_type_by_full_name("System.Object").unwrap();
/// let comparer = provider.comparer();
/// assert!(comparer.equals(object.handle(), object.handle()));
/// ```
pub struct StructuralComparer<'a> {
    provider: &'a ProviderInner,
}

impl<'a> StructuralComparer<'a> {
    pub(crate) fn new(provider: &'a ProviderInner) -> Self {
        StructuralComparer { provider }
    }

    /// The canonical form of `handle`
    #[must_use]
    pub fn canonical(&self, handle: &Handle) -> Handle {
        self.provider.canonical(handle)
    }

    /// The canonical form of a type handle
    #[must_use]
    pub fn canonical_type(&self, handle: &TypeHandle) -> TypeHandle {
        self.provider.canonical_type(handle)
    }

    /// Returns true if both handles denote the same logical entity.
    #[must_use]
    pub fn equals(&self, left: impl Into<Handle>, right: impl Into<Handle>) -> bool {
        self.canonical(&left.into()) == self.canonical(&right.into())
    }

    /// Hash consistent with [`StructuralComparer::equals`].
    #[must_use]
    pub fn hash(&self, handle: impl Into<Handle>) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.canonical(&handle.into()).hash(&mut hasher);
        hasher.finish()
    }
}

impl From<&TypeHandle> for Handle {
    fn from(handle: &TypeHandle) -> Self {
        Handle::Type(handle.clone())
    }
}

impl From<&Handle> for Handle {
    fn from(handle: &Handle) -> Self {
        handle.clone()
    }
}

#[cfg(test)]
mod tests {
    use crate::metadata::{
        builder::{ModuleBuilder, TypeBuilder},
        handle::{GenericOwner, TypeHandle},
        provider::MetadataProvider,
        signatures::TypeSignature,
        tables::TableId,
    };

    #[test]
    fn nested_parameter_owner() {
        let mut module = ModuleBuilder::new("Nesting");
        let outer = TypeBuilder::class("N", "Box`1")
            .generic_parameter("T")
            .build(&mut module)
            .unwrap();
        let inner = TypeBuilder::class("", "Inner`1")
            .nested_in(outer)
            .generic_parameter("U")
            .build(&mut module)
            .unwrap();
        let module = module.build().unwrap();
        let provider = MetadataProvider::new();
        provider.register_module(&module);
        let comparer = provider.comparer();

        let seen_from_inner = TypeHandle::Parameter {
            owner: GenericOwner::Type {
                module: module.id(),
                row: inner.row(),
            },
            number: 0,
        };
        let declared = TypeHandle::Parameter {
            owner: GenericOwner::Type {
                module: module.id(),
                row: outer.row(),
            },
            number: 0,
        };
        assert!(comparer.equals(&seen_from_inner, &declared));
        assert_eq!(comparer.hash(&seen_from_inner), comparer.hash(&declared));

        // Same position, different declaring member
        let own = TypeHandle::Parameter {
            owner: GenericOwner::Type {
                module: module.id(),
                row: inner.row(),
            },
            number: 1,
        };
        let method_level = TypeHandle::Parameter {
            owner: GenericOwner::Method {
                module: module.id(),
                row: 1,
            },
            number: 1,
        };
        assert!(!comparer.equals(&own, &method_level));
    }

    #[test]
    fn instance_over_own_parameters() {
        let mut module = ModuleBuilder::new("Instances");
        let boxed = TypeBuilder::class("N", "Box`1")
            .generic_parameter("T")
            .build(&mut module)
            .unwrap();
        let module = module.build().unwrap();
        let provider = MetadataProvider::new();
        provider.register_module(&module);
        let comparer = provider.comparer();

        let definition = TypeHandle::definition(module.id(), boxed.row());
        let open = TypeHandle::Instance {
            definition: Box::new(definition.clone()),
            arguments: vec![TypeHandle::Parameter {
                owner: GenericOwner::Type {
                    module: module.id(),
                    row: boxed.row(),
                },
                number: 0,
            }],
        };
        assert!(comparer.equals(&open, &definition));

        let int = provider
            .find_type_by_full_name("System.Int32")
            .unwrap()
            .handle()
            .clone();
        let closed = TypeHandle::Instance {
            definition: Box::new(definition.clone()),
            arguments: vec![int],
        };
        assert!(!comparer.equals(&closed, &definition));
    }

    #[test]
    fn references_bind_to_definitions() {
        let mut library = ModuleBuilder::new("Library");
        let shape = TypeBuilder::class("Shapes", "Shape")
            .build(&mut library)
            .unwrap();
        let library = library.build().unwrap();

        let mut client = ModuleBuilder::new("Client");
        let reference = client.type_ref("Library", "Shapes", "Shape");
        let object = client.core_type("System", "Object").unwrap();
        TypeBuilder::class("App", "Circle")
            .extends(TypeSignature::Class(reference))
            .build(&mut client)
            .unwrap();
        let client = client.build().unwrap();

        let provider = MetadataProvider::new();
        provider.register_module(&client);
        let comparer = provider.comparer();
        let by_reference = TypeHandle::Reference {
            module: client.id(),
            row: reference.row(),
        };

        // Library is not resident yet: the reference stays symbolic
        assert!(matches!(
            comparer.canonical_type(&by_reference),
            TypeHandle::Named { .. }
        ));

        provider.register_module(&library);
        let definition = TypeHandle::definition(library.id(), shape.row());
        assert!(comparer.equals(&by_reference, &definition));

        // Core references bind to the core library
        let core_object = provider
            .find_type_by_full_name("System.Object")
            .unwrap()
            .handle()
            .clone();
        assert!(object.is_table(TableId::TypeRef));
        assert!(comparer.equals(
            &TypeHandle::Reference {
                module: client.id(),
                row: object.row(),
            },
            &core_object
        ));
    }
}
