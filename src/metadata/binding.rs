//! Binding of type references and signatures to canonical handles.
//!
//! A `TypeRef` binds, in order, to a registered module of the referenced assembly, to the core
//! library for the core assembly names, to a module an [`AssemblyResolver`] supplies, and
//! otherwise to a [`TypeHandle::Named`] that is retried on every canonicalization.
//!
//! [`AssemblyResolver`]: crate::metadata::provider::AssemblyResolver

use crate::{
    metadata::{
        corlib::{self, is_core_assembly},
        handle::{GenericOwner, TypeHandle},
        module::ModuleRc,
        provider::ProviderInner,
        signatures::{parse_type_spec_signature, TypeSignature},
        tables::{row, TableId},
        token::Token,
    },
    Error, Result,
};

/// Deepest signature nesting accepted when converting to handles
const MAX_SIGNATURE_DEPTH: usize = 64;

/// The generic context a signature is read in.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Scope {
    /// TypeDef row whose parameters `!n` refers to
    pub type_row: Option<u32>,
    /// Owner of the parameters `!!n` refers to
    pub method: Option<GenericOwner>,
}

impl Scope {
    pub(crate) fn of_type(type_row: u32) -> Self {
        Scope {
            type_row: Some(type_row),
            method: None,
        }
    }

    pub(crate) fn of_method(module: &ModuleRc, type_row: Option<u32>, method_row: u32) -> Self {
        Scope {
            type_row,
            method: Some(GenericOwner::Method {
                module: module.id(),
                row: method_row,
            }),
        }
    }
}

impl ProviderInner {
    /// Binds the TypeRef `type_ref` of `module`; `None` if the row does not exist.
    pub(crate) fn resolve_type_ref(&self, module: &ModuleRc, type_ref: u32) -> Option<TypeHandle> {
        let reference = module.type_ref(type_ref)?;
        let scope = reference.resolution_scope;

        if scope.is_table(TableId::TypeRef) {
            return Some(match self.resolve_type_ref(module, scope.row())? {
                TypeHandle::Definition { module: id, row } => {
                    let nested = self
                        .module(id)
                        .ok()
                        .and_then(|enclosing| enclosing.find_nested(row, &reference.name));
                    match nested {
                        Some(nested) => TypeHandle::Definition { module: id, row: nested },
                        None => {
                            let enclosing = self
                                .module(id)
                                .map(|m| (m.assembly_name().to_string(), m.type_full_name(row)))
                                .unwrap_or_default();
                            TypeHandle::Named {
                                assembly: enclosing.0.into(),
                                full_name: format!("{}+{}", enclosing.1, reference.name).into(),
                            }
                        }
                    }
                }
                TypeHandle::Named {
                    assembly,
                    full_name,
                } => TypeHandle::Named {
                    assembly,
                    full_name: format!("{full_name}+{}", reference.name).into(),
                },
                other => other,
            });
        }

        let full_name = if reference.namespace.is_empty() {
            reference.name.clone()
        } else {
            format!("{}.{}", reference.namespace, reference.name)
        };

        if scope.is_table(TableId::AssemblyRef) {
            let assembly = row(&module.tables().assembly_ref, scope.row())?;
            return Some(self.bind_named(&assembly.name, &full_name));
        }

        // Module, ModuleRef and null scopes all point back into this assembly
        Some(match module.find_type(&reference.namespace, &reference.name) {
            Some(row) => TypeHandle::Definition {
                module: module.id(),
                row,
            },
            None => TypeHandle::Named {
                assembly: module.assembly_name().into(),
                full_name: full_name.into(),
            },
        })
    }

    /// Binds `full_name` of `assembly` to a resident definition, if there is one.
    pub(crate) fn bind_named(&self, assembly: &str, full_name: &str) -> TypeHandle {
        let modules = self.search_order();
        let definition = |module: &ModuleRc| {
            module
                .find_type_by_full_name(full_name)
                .map(|row| TypeHandle::Definition {
                    module: module.id(),
                    row,
                })
        };

        for module in &modules {
            if module.assembly_name().eq_ignore_ascii_case(assembly) {
                if let Some(found) = definition(module) {
                    return found;
                }
            }
        }

        // Core names are facades; the type may live in any resident module
        if is_core_assembly(assembly) {
            if let Some(found) = modules.iter().find_map(definition) {
                return found;
            }
        }

        for resolver in self.resolvers() {
            if let Some(module) = resolver.resolve_assembly(assembly) {
                self.register(&module);
                if let Some(found) = definition(&module) {
                    return found;
                }
            }
        }

        tracing::debug!(assembly, full_name, "type reference not resident");
        TypeHandle::Named {
            assembly: assembly.into(),
            full_name: full_name.into(),
        }
    }

    /// The core library definition `System.{name}`
    pub(crate) fn core_definition(&self, namespace: &str, name: &str) -> Result<TypeHandle> {
        let core = corlib::core_library()?;
        let row = core.find_type(namespace, name).ok_or_else(|| {
            malformed_error!("Core library does not define {}.{}", namespace, name)
        })?;
        Ok(TypeHandle::Definition {
            module: core.id(),
            row,
        })
    }

    /// Returns true if `handle` is the core library type `namespace.name`
    pub(crate) fn is_core_type(&self, handle: &TypeHandle, namespace: &str, name: &str) -> bool {
        self.core_definition(namespace, name)
            .is_ok_and(|core| &core == handle)
    }

    /// The handle of a TypeDefOrRefOrSpec `token` of `module`
    pub(crate) fn type_token(
        &self,
        module: &ModuleRc,
        scope: Scope,
        token: Token,
    ) -> Result<TypeHandle> {
        self.type_token_at(module, scope, token, 0)
    }

    fn type_token_at(
        &self,
        module: &ModuleRc,
        scope: Scope,
        token: Token,
        depth: usize,
    ) -> Result<TypeHandle> {
        match token.table_id() {
            Some(TableId::TypeDef) if module.type_def(token.row()).is_some() => {
                Ok(TypeHandle::Definition {
                    module: module.id(),
                    row: token.row(),
                })
            }
            Some(TableId::TypeRef) => self
                .resolve_type_ref(module, token.row())
                .ok_or(Error::TokenNotFound(token)),
            Some(TableId::TypeSpec) => {
                let spec = row(&module.tables().type_spec, token.row())
                    .ok_or(Error::TokenNotFound(token))?;
                let signature = parse_type_spec_signature(&spec.signature)?;
                self.convert_at(module, scope, &signature.base, depth + 1)
            }
            _ => Err(Error::TokenNotFound(token)),
        }
    }

    /// Converts a signature type of `module`, read in `scope`, to its canonical handle.
    pub(crate) fn convert(
        &self,
        module: &ModuleRc,
        scope: Scope,
        signature: &TypeSignature,
    ) -> Result<TypeHandle> {
        self.convert_at(module, scope, signature, 0)
    }

    fn convert_at(
        &self,
        module: &ModuleRc,
        scope: Scope,
        signature: &TypeSignature,
        depth: usize,
    ) -> Result<TypeHandle> {
        if depth > MAX_SIGNATURE_DEPTH {
            return Err(Error::RecursionLimit(MAX_SIGNATURE_DEPTH));
        }
        let element = |inner: &TypeSignature| -> Result<Box<TypeHandle>> {
            Ok(Box::new(self.convert_at(module, scope, inner, depth + 1)?))
        };

        Ok(match signature {
            TypeSignature::TypedByRef => TypeHandle::TypedReference,
            TypeSignature::Class(token) | TypeSignature::ValueType(token) => {
                self.type_token_at(module, scope, *token, depth + 1)?
            }
            TypeSignature::GenericInst(definition, arguments) => {
                let definition = element(definition)?;
                let arguments = arguments
                    .iter()
                    .map(|argument| self.convert_at(module, scope, argument, depth + 1))
                    .collect::<Result<Vec<_>>>()?;
                self.canonical_type(&TypeHandle::Instance {
                    definition,
                    arguments,
                })
            }
            TypeSignature::GenericParamType(number) => {
                let row = scope.type_row.ok_or_else(|| {
                    malformed_error!("Type parameter !{} used outside of a generic type", number)
                })?;
                self.canonical_type(&TypeHandle::Parameter {
                    owner: GenericOwner::Type {
                        module: module.id(),
                        row,
                    },
                    number: *number,
                })
            }
            TypeSignature::GenericParamMethod(number) => TypeHandle::Parameter {
                owner: scope.method.ok_or_else(|| {
                    malformed_error!(
                        "Method parameter !!{} used outside of a generic method",
                        number
                    )
                })?,
                number: *number,
            },
            TypeSignature::SzArray(inner) => TypeHandle::Array {
                element: element(inner)?,
                rank: 0,
            },
            TypeSignature::Array(inner, rank) => TypeHandle::Array {
                element: element(inner)?,
                rank: *rank,
            },
            TypeSignature::Ptr(inner) => TypeHandle::Pointer(element(inner)?),
            TypeSignature::ByRef(inner) => TypeHandle::ByRef(element(inner)?),
            TypeSignature::FnPtr(_) => TypeHandle::FunctionPointer,
            primitive => match primitive.primitive_name() {
                Some(name) => self.core_definition("System", name)?,
                None => return Err(malformed_error!("Unexpected signature type {:?}", primitive)),
            },
        })
    }
}
