//! Extension members: static methods of utility types that read as members of their first
//! parameter's type.
//!
//! Discovery scans an explicit list of container types in order, so the result follows the
//! declaration order of the containers, then of the methods inside each. Scanning the same
//! container twice reports its members twice.

use std::sync::Arc;

use crate::metadata::{
    handle::{GenericOwner, TypeHandle},
    tables::TableId,
    token::Token,
    typesystem::{Method, MethodKind, MethodRc, Type, TypeKind, TypeRc},
};

const EXTENSION_NAMESPACE: &str = "System.Runtime.CompilerServices";
const EXTENSION_ATTRIBUTE: &str = "ExtensionAttribute";

/// A `get_X`/`set_X` pair of extension methods sharing a receiver, presented as property `X`.
#[derive(Debug, Clone)]
pub struct ExtensionProperty {
    name: String,
    receiver: TypeRc,
    getter: Option<MethodRc>,
    setter: Option<MethodRc>,
}

impl ExtensionProperty {
    /// Property name, without the accessor prefix
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The receiver type declared by the accessors
    #[must_use]
    pub fn receiver(&self) -> &TypeRc {
        &self.receiver
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn getter(&self) -> Option<&MethodRc> {
        self.getter.as_ref()
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn setter(&self) -> Option<&MethodRc> {
        self.setter.as_ref()
    }

    /// Return type of the getter, else the value parameter type of the setter
    #[must_use]
    pub fn property_type(&self) -> Option<TypeRc> {
        match (&self.getter, &self.setter) {
            (Some(getter), _) => getter.return_type(),
            (None, Some(setter)) => setter.parameter_types().get(1).cloned(),
            (None, None) => None,
        }
    }

    /// The container type declaring the accessors
    #[must_use]
    pub fn declaring_type(&self) -> Option<TypeRc> {
        self.getter.as_ref().or(self.setter.as_ref())?.declaring_type()
    }
}

impl Method {
    /// Returns true for static methods marked with `ExtensionAttribute` that take a receiver
    #[must_use]
    pub fn is_extension(&self) -> bool {
        self.is_static()
            && !self.parameter_type_handles().is_empty()
            && self.module().is_some_and(|module| {
                module.has_attribute(self.token(), EXTENSION_NAMESPACE, EXTENSION_ATTRIBUTE)
            })
    }

    /// The receiver of an extension method, its first parameter type
    #[must_use]
    pub fn receiver_type(&self) -> Option<TypeRc> {
        if !self.is_extension() {
            return None;
        }
        self.parameter_types().into_iter().next()
    }

    /// `X` for special-name `get_X`/`set_X` extension accessors
    fn extension_property_name(&self) -> Option<(&str, bool)> {
        if !self.is_special_name() {
            return None;
        }
        if let Some(name) = self.name().strip_prefix("get_") {
            return (self.parameter_type_handles().len() == 1).then_some((name, true));
        }
        let name = self.name().strip_prefix("set_")?;
        (self.parameter_type_handles().len() == 2).then_some((name, false))
    }
}

/// Method type parameters of a receiver and the types they were bound to
type Bindings = Vec<(TypeHandle, TypeHandle)>;

impl Type {
    /// Returns true for types declaring extension methods: marked with `ExtensionAttribute`,
    /// or static classes with at least one extension method
    #[must_use]
    pub fn is_extension_container(&self) -> bool {
        let Some(module) = self.module() else {
            return false;
        };
        if !matches!(self.handle, TypeHandle::Definition { .. }) {
            return false;
        }
        module.has_attribute(
            Token::from_parts(TableId::TypeDef, self.row),
            EXTENSION_NAMESPACE,
            EXTENSION_ATTRIBUTE,
        ) || (self.is_static() && self.all_methods().iter().any(|method| method.is_extension()))
    }

    /// Returns true if an extension receiver of type `receiver` accepts this type.
    ///
    /// A bare generic parameter receiver checks its constraints. A receiver over method type
    /// parameters must unify with this type, a base type or an interface, and every parameter it
    /// binds must accept its argument. Closed receivers use assignability, except that an open
    /// target only matches the identical construction.
    fn accepted_by_receiver(self: &Arc<Self>, receiver: &Type) -> bool {
        if receiver.kind == TypeKind::GenericParameter {
            return receiver.is_satisfiable_by(self);
        }
        if !receiver.handle.contains_parameters() {
            if !self.contains_generic_parameters() {
                return receiver.is_assignable_from(self);
            }
            return self
                .ancestors_and_interfaces()
                .iter()
                .any(|ancestor| ancestor.handle == receiver.handle);
        }
        self.ancestors_and_interfaces().iter().any(|ancestor| {
            let mut bindings = Bindings::new();
            receiver.unify(&receiver.handle, &ancestor.handle, &mut bindings)
                && receiver.bindings_satisfied(&bindings)
        })
    }

    /// Matches `pattern` against `actual`. A method type parameter binds on its first
    /// occurrence; later occurrences and everything else must be structurally identical.
    fn unify(&self, pattern: &TypeHandle, actual: &TypeHandle, bindings: &mut Bindings) -> bool {
        match (pattern, actual) {
            (
                TypeHandle::Parameter {
                    owner: GenericOwner::Method { .. },
                    ..
                },
                _,
            ) => match bindings.iter().find(|(parameter, _)| parameter == pattern) {
                Some((_, bound)) => bound == actual,
                None => {
                    bindings.push((pattern.clone(), actual.clone()));
                    true
                }
            },
            (
                TypeHandle::Instance {
                    definition,
                    arguments,
                },
                TypeHandle::Instance {
                    definition: actual_definition,
                    arguments: actual_arguments,
                },
            ) => {
                definition == actual_definition
                    && arguments.len() == actual_arguments.len()
                    && arguments
                        .iter()
                        .zip(actual_arguments)
                        .all(|(argument, actual)| self.unify(argument, actual, bindings))
            }
            // a generic definition is its construction over its own parameters
            (TypeHandle::Instance { definition, .. }, TypeHandle::Definition { .. })
                if **definition == *actual =>
            {
                let Some(generic) = self.resolve(actual) else {
                    return false;
                };
                let own = TypeHandle::Instance {
                    definition: Box::new(actual.clone()),
                    arguments: generic
                        .generic_parameters()
                        .iter()
                        .map(|parameter| parameter.handle.clone())
                        .collect(),
                };
                self.unify(pattern, &own, bindings)
            }
            (
                TypeHandle::Array { element, rank },
                TypeHandle::Array {
                    element: actual_element,
                    rank: actual_rank,
                },
            ) => rank == actual_rank && self.unify(element, actual_element, bindings),
            (TypeHandle::Pointer(element), TypeHandle::Pointer(actual_element))
            | (TypeHandle::ByRef(element), TypeHandle::ByRef(actual_element)) => {
                self.unify(element, actual_element, bindings)
            }
            _ => pattern == actual,
        }
    }

    fn bindings_satisfied(&self, bindings: &Bindings) -> bool {
        bindings.iter().all(|(parameter, argument)| {
            match (self.resolve(parameter), self.resolve(argument)) {
                (Some(parameter), Some(argument)) => parameter.is_satisfiable_by(&argument),
                _ => false,
            }
        })
    }

    fn matching_extensions(self: &Arc<Self>, containers: &[TypeRc]) -> Vec<Vec<MethodRc>> {
        containers
            .iter()
            .map(|container| {
                container
                    .all_methods()
                    .into_iter()
                    .filter(|method| method.kind() == MethodKind::Method && method.is_extension())
                    .filter(|method| {
                        method
                            .receiver_type()
                            .is_some_and(|receiver| self.accepted_by_receiver(&receiver))
                    })
                    .collect()
            })
            .collect()
    }

    /// Extension methods of `containers` whose receiver accepts this type, in container order
    /// then declaration order. `get_X`/`set_X` accessors are reported by
    /// [`Type::extension_properties`] instead.
    #[must_use]
    pub fn extension_methods(self: &Arc<Self>, containers: &[TypeRc]) -> Vec<MethodRc> {
        self.matching_extensions(containers)
            .into_iter()
            .flatten()
            .filter(|method| method.extension_property_name().is_none())
            .collect()
    }

    /// Extension properties of `containers` whose receiver accepts this type. Accessors of one
    /// container with the same name and receiver merge into one property.
    #[must_use]
    pub fn extension_properties(self: &Arc<Self>, containers: &[TypeRc]) -> Vec<ExtensionProperty> {
        let mut properties = Vec::new();
        for methods in self.matching_extensions(containers) {
            let mut found: Vec<ExtensionProperty> = Vec::new();
            for method in methods {
                let Some((name, is_getter)) = method.extension_property_name() else {
                    continue;
                };
                let Some(receiver) = method.receiver_type() else {
                    continue;
                };
                let position = found
                    .iter()
                    .position(|property| property.name == name && property.receiver == receiver);
                let property = match position {
                    Some(position) => &mut found[position],
                    None => {
                        found.push(ExtensionProperty {
                            name: name.to_string(),
                            receiver,
                            getter: None,
                            setter: None,
                        });
                        let last = found.len() - 1;
                        &mut found[last]
                    }
                };
                let slot = if is_getter {
                    &mut property.getter
                } else {
                    &mut property.setter
                };
                slot.get_or_insert(method);
            }
            properties.extend(found);
        }
        properties
    }
}
