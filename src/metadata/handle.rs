//! Raw handles: the keys the model is built from.
//!
//! A handle names a metadata entity without materializing it. Handles are plain values: they
//! carry the [`ModuleId`] of the module they point into and the one-based row of the entity, plus
//! the structure needed for entities that have no row of their own (generic instances, arrays,
//! pointers). Handles produced by the provider are canonical, so the derived `Eq`/`Hash` are the
//! structural identity; handles built by hand can be canonicalized through
//! [`crate::metadata::comparer::StructuralComparer`].

use std::sync::Arc;

use crate::metadata::{module::ModuleId, tables::TableId, token::Token};

/// The declaration owning a generic parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenericOwner {
    /// A generic type definition
    Type {
        /// Module of the definition
        module: ModuleId,
        /// TypeDef row
        row: u32,
    },
    /// A generic method definition
    Method {
        /// Module of the definition
        module: ModuleId,
        /// MethodDef row
        row: u32,
    },
}

impl GenericOwner {
    /// Module of the owning declaration
    #[must_use]
    pub fn module(&self) -> ModuleId {
        match self {
            GenericOwner::Type { module, .. } | GenericOwner::Method { module, .. } => *module,
        }
    }

    /// `TypeDef` or `MethodDef` token of the owning declaration
    #[must_use]
    pub fn token(&self) -> Token {
        match self {
            GenericOwner::Type { row, .. } => Token::from_parts(TableId::TypeDef, *row),
            GenericOwner::Method { row, .. } => Token::from_parts(TableId::MethodDef, *row),
        }
    }
}

/// A type, as reached through any lookup path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeHandle {
    /// A `TypeDef` row
    Definition {
        /// Module of the definition
        module: ModuleId,
        /// TypeDef row
        row: u32,
    },
    /// A `TypeRef` row, not yet bound to its definition. Never canonical.
    Reference {
        /// Module holding the reference
        module: ModuleId,
        /// TypeRef row
        row: u32,
    },
    /// A type of an assembly that is not resident
    Named {
        /// Name of the assembly the type was referenced from
        assembly: Arc<str>,
        /// Full name, nested types separated by `+`
        full_name: Arc<str>,
    },
    /// A constructed generic type
    Instance {
        /// The generic type definition
        definition: Box<TypeHandle>,
        /// Type arguments for the full parameter list of the definition
        arguments: Vec<TypeHandle>,
    },
    /// A generic parameter; `number` indexes the owner's full parameter list
    Parameter {
        /// Declaring type or method
        owner: GenericOwner,
        /// Index in the owner's parameter list
        number: u32,
    },
    /// An array; rank 0 is a single-dimensional, zero-based vector (`T[]`)
    Array {
        /// Element type
        element: Box<TypeHandle>,
        /// Number of dimensions, 0 for vectors
        rank: u32,
    },
    /// An unmanaged pointer
    Pointer(Box<TypeHandle>),
    /// A managed reference
    ByRef(Box<TypeHandle>),
    /// A function pointer; has no metadata object
    FunctionPointer,
    /// `System.TypedReference` in a signature; has no metadata object
    TypedReference,
}

impl TypeHandle {
    /// The handle of a `TypeDef` row
    #[must_use]
    pub fn definition(module: ModuleId, row: u32) -> Self {
        TypeHandle::Definition { module, row }
    }

    /// Module the handle's entity lives in, used to tie cache entries to module lifetime.
    ///
    /// Constructed types and decorators live with their definition or element type; named types
    /// of missing assemblies have no module.
    #[must_use]
    pub fn home(&self) -> Option<ModuleId> {
        match self {
            TypeHandle::Definition { module, .. } | TypeHandle::Reference { module, .. } => {
                Some(*module)
            }
            TypeHandle::Parameter { owner, .. } => Some(owner.module()),
            TypeHandle::Instance { definition, .. } => definition.home(),
            TypeHandle::Array { element, .. }
            | TypeHandle::Pointer(element)
            | TypeHandle::ByRef(element) => element.home(),
            TypeHandle::Named { .. } | TypeHandle::FunctionPointer | TypeHandle::TypedReference => {
                None
            }
        }
    }

    /// Returns true if a generic parameter occurs anywhere in the handle
    #[must_use]
    pub fn contains_parameters(&self) -> bool {
        match self {
            TypeHandle::Parameter { .. } => true,
            TypeHandle::Instance { arguments, .. } => {
                arguments.iter().any(TypeHandle::contains_parameters)
            }
            TypeHandle::Array { element, .. }
            | TypeHandle::Pointer(element)
            | TypeHandle::ByRef(element) => element.contains_parameters(),
            _ => false,
        }
    }

    /// Replaces type-level parameters by `arguments` and method-level parameters by
    /// `method_arguments`. Parameters without a matching argument are kept.
    ///
    /// The result is not canonicalized; a substitution can produce an instance whose arguments
    /// are the definition's own parameters.
    #[must_use]
    pub fn substitute(&self, arguments: &[TypeHandle], method_arguments: &[TypeHandle]) -> Self {
        match self {
            TypeHandle::Parameter {
                owner: GenericOwner::Type { .. },
                number,
            } => arguments
                .get(*number as usize)
                .cloned()
                .unwrap_or_else(|| self.clone()),
            TypeHandle::Parameter {
                owner: GenericOwner::Method { .. },
                number,
            } => method_arguments
                .get(*number as usize)
                .cloned()
                .unwrap_or_else(|| self.clone()),
            TypeHandle::Instance {
                definition,
                arguments: own,
            } => TypeHandle::Instance {
                definition: definition.clone(),
                arguments: own
                    .iter()
                    .map(|argument| argument.substitute(arguments, method_arguments))
                    .collect(),
            },
            TypeHandle::Array { element, rank } => TypeHandle::Array {
                element: Box::new(element.substitute(arguments, method_arguments)),
                rank: *rank,
            },
            TypeHandle::Pointer(element) => {
                TypeHandle::Pointer(Box::new(element.substitute(arguments, method_arguments)))
            }
            TypeHandle::ByRef(element) => {
                TypeHandle::ByRef(Box::new(element.substitute(arguments, method_arguments)))
            }
            other => other.clone(),
        }
    }
}

/// A method or constructor, possibly of a constructed type or with method type arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodHandle {
    /// The declaring type; an instance for members of constructed types
    pub declaring: TypeHandle,
    /// Module holding the `MethodDef` row
    pub module: ModuleId,
    /// MethodDef row
    pub row: u32,
    /// Method type arguments, empty unless this is a constructed generic method
    pub arguments: Vec<TypeHandle>,
}

impl MethodHandle {
    /// The `MethodDef` token
    #[must_use]
    pub fn token(&self) -> Token {
        Token::from_parts(TableId::MethodDef, self.row)
    }
}

/// A field, property or event of a declaring type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberHandle {
    /// The declaring type; an instance for members of constructed types
    pub declaring: TypeHandle,
    /// Module holding the row
    pub module: ModuleId,
    /// Row in the member's table
    pub row: u32,
}

/// A parameter of a method; `position` is zero-based and excludes the return value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParameterHandle {
    /// The declaring method
    pub method: MethodHandle,
    /// Zero-based position in the parameter list
    pub position: u32,
}

/// Any raw handle the model can materialize.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Handle {
    Type(TypeHandle),
    Method(MethodHandle),
    Field(MemberHandle),
    Property(MemberHandle),
    Event(MemberHandle),
    Parameter(ParameterHandle),
}

impl Handle {
    /// Module the handle's entity lives in, see [`TypeHandle::home`]
    #[must_use]
    pub fn home(&self) -> Option<ModuleId> {
        match self {
            Handle::Type(handle) => handle.home(),
            Handle::Method(handle) => Some(handle.module),
            Handle::Field(handle) | Handle::Property(handle) | Handle::Event(handle) => {
                Some(handle.module)
            }
            Handle::Parameter(handle) => Some(handle.method.module),
        }
    }
}

impl From<TypeHandle> for Handle {
    fn from(handle: TypeHandle) -> Self {
        Handle::Type(handle)
    }
}

impl From<MethodHandle> for Handle {
    fn from(handle: MethodHandle) -> Self {
        Handle::Method(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module() -> ModuleId {
        crate::metadata::builder::ModuleBuilder::new("Handles")
            .build()
            .unwrap()
            .id()
    }

    #[test]
    fn substitution() {
        let module = module();
        let t = TypeHandle::Parameter {
            owner: GenericOwner::Type { module, row: 1 },
            number: 0,
        };
        let m = TypeHandle::Parameter {
            owner: GenericOwner::Method { module, row: 1 },
            number: 0,
        };
        let int = TypeHandle::definition(module, 7);
        let long = TypeHandle::definition(module, 8);

        let open = TypeHandle::Array {
            element: Box::new(TypeHandle::Instance {
                definition: Box::new(TypeHandle::definition(module, 2)),
                arguments: vec![t.clone(), m.clone()],
            }),
            rank: 0,
        };
        assert!(open.contains_parameters());

        let closed = open.substitute(&[int.clone()], &[long.clone()]);
        assert!(!closed.contains_parameters());
        assert_eq!(
            closed,
            TypeHandle::Array {
                element: Box::new(TypeHandle::Instance {
                    definition: Box::new(TypeHandle::definition(module, 2)),
                    arguments: vec![int.clone(), long],
                }),
                rank: 0,
            }
        );

        // Only type-level arguments supplied, method parameters stay open
        let partial = open.substitute(&[int], &[]);
        assert!(partial.contains_parameters());
    }

    #[test]
    fn homes() {
        let module = module();
        let definition = TypeHandle::definition(module, 1);
        assert_eq!(definition.home(), Some(module));
        assert_eq!(
            TypeHandle::ByRef(Box::new(definition.clone())).home(),
            Some(module)
        );
        assert_eq!(
            TypeHandle::Named {
                assembly: "Other".into(),
                full_name: "N.C".into()
            }
            .home(),
            None
        );
        assert_eq!(TypeHandle::FunctionPointer.home(), None);

        let method = MethodHandle {
            declaring: definition,
            module,
            row: 3,
            arguments: Vec::new(),
        };
        assert_eq!(method.token(), Token::new(0x0600_0003));
        assert_eq!(Handle::from(method).home(), Some(module));
    }
}
