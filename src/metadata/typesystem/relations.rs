//! Type relationships: base chain, interfaces, reverse indices, and the assignability,
//! subclass and substitutability relations.

use std::sync::Arc;

use crate::metadata::{
    binding::Scope,
    flags::GenericParamAttributes,
    handle::TypeHandle,
    provider::MetadataProvider,
    typesystem::{logged, Type, TypeKind, TypeModifier, TypeRc, Variance, MAX_CHAIN_DEPTH},
};

/// Nesting depth at which assignability checks give up
const MAX_ASSIGNABILITY_DEPTH: usize = 64;

/// Implicit numeric conversions between primitives, as `(source, targets)`
const WIDENING: [(&str, &[&str]); 10] = [
    ("SByte", &["Int16", "Int32", "Int64", "Single", "Double"]),
    (
        "Byte",
        &["Int16", "UInt16", "Int32", "UInt32", "Int64", "UInt64", "Single", "Double"],
    ),
    ("Int16", &["Int32", "Int64", "Single", "Double"]),
    ("UInt16", &["Int32", "UInt32", "Int64", "UInt64", "Single", "Double"]),
    ("Int32", &["Int64", "Single", "Double"]),
    ("UInt32", &["Int64", "UInt64", "Single", "Double"]),
    ("Int64", &["Single", "Double"]),
    ("UInt64", &["Single", "Double"]),
    (
        "Char",
        &["UInt16", "Int32", "UInt32", "Int64", "UInt64", "Single", "Double"],
    ),
    ("Single", &["Double"]),
];

fn widens(source: &Type, target: &Type) -> bool {
    if source.kind != TypeKind::Primitive || target.kind != TypeKind::Primitive {
        return false;
    }
    WIDENING
        .iter()
        .find(|(name, _)| *name == source.name)
        .is_some_and(|(_, targets)| targets.contains(&target.name.as_str()))
}

/// Pushes `handle` unless already present
fn push_unique(list: &mut Vec<TypeHandle>, handle: TypeHandle) {
    if !list.contains(&handle) {
        list.push(handle);
    }
}

impl Type {
    /// Handle of the base type; computed on load except for generic parameters, whose base is
    /// their class constraint, `System.ValueType` under a `struct` constraint, or `System.Object`.
    pub(crate) fn base_handle(&self) -> Option<TypeHandle> {
        self.base
            .get_or_init(|| {
                if self.kind != TypeKind::GenericParameter {
                    return None;
                }
                let provider = self.inner()?;
                let class = self.type_constraints().into_iter().find(|constraint| {
                    !constraint.is_interface() && constraint.kind != TypeKind::GenericParameter
                });
                if let Some(class) = class {
                    return Some(class.handle.clone());
                }
                let fallback = if self
                    .constraint_flags()
                    .contains(GenericParamAttributes::NOT_NULLABLE_VALUE_TYPE_CONSTRAINT)
                {
                    "ValueType"
                } else {
                    "Object"
                };
                provider.core_definition("System", fallback).ok()
            })
            .clone()
    }

    /// The direct base type; `None` for `System.Object`, interfaces, pointers and by-refs
    #[must_use]
    pub fn base_type(&self) -> Option<TypeRc> {
        self.resolve(&self.base_handle()?)
    }

    /// Every base type, root first, excluding this type
    #[must_use]
    pub fn base_type_hierarchy(&self) -> Vec<TypeRc> {
        let mut chain: Vec<TypeRc> = Vec::new();
        let mut current = self.base_type();
        while let Some(ty) = current {
            if chain.len() >= MAX_CHAIN_DEPTH || chain.contains(&ty) {
                tracing::warn!(ty = %self.full_name(), "cyclic or too deep base type chain");
                break;
            }
            current = ty.base_type();
            chain.push(ty);
        }
        chain.reverse();
        chain
    }

    fn declared_interface_handles(&self) -> Vec<TypeHandle> {
        let Some(provider) = self.inner() else {
            return Vec::new();
        };
        match &self.handle {
            TypeHandle::Definition { .. } => {
                let Some(module) = self.module() else {
                    return Vec::new();
                };
                module
                    .interfaces(self.row)
                    .iter()
                    .filter_map(|token| {
                        logged(
                            provider.type_token(&module, Scope::of_type(self.row), *token),
                            &self.name,
                        )
                    })
                    .collect()
            }
            TypeHandle::Instance {
                definition,
                arguments,
            } => match self.resolve(definition) {
                Some(generic) => generic
                    .interface_handles()
                    .iter()
                    .map(|interface| {
                        provider.canonical_type(&interface.substitute(arguments, &[]))
                    })
                    .collect(),
                None => Vec::new(),
            },
            TypeHandle::Parameter { .. } => self
                .type_constraints()
                .into_iter()
                .filter(|constraint| constraint.is_interface())
                .map(|constraint| constraint.handle.clone())
                .collect(),
            TypeHandle::Array { element, rank: 0 } => provider
                .core_definition("System.Collections.Generic", "IEnumerable`1")
                .map(|enumerable| {
                    vec![TypeHandle::Instance {
                        definition: Box::new(enumerable),
                        arguments: vec![element.as_ref().clone()],
                    }]
                })
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    fn interface_handles(&self) -> &[TypeHandle] {
        self.interfaces
            .get_or_init(|| self.declared_interface_handles())
    }

    /// Interfaces declared directly on this type, in declaration order
    #[must_use]
    pub fn interfaces(&self) -> Vec<TypeRc> {
        self.interface_handles()
            .iter()
            .filter_map(|interface| self.resolve(interface))
            .collect()
    }

    fn implemented_handles(&self) -> &[TypeHandle] {
        self.implemented.get_or_init(|| {
            let mut closure = Vec::new();
            let mut pending: Vec<TypeHandle> = self.interface_handles().to_vec();
            for base in self.base_type_hierarchy().iter().rev() {
                pending.extend(base.interface_handles().iter().cloned());
            }
            pending.reverse();

            while let Some(handle) = pending.pop() {
                if closure.contains(&handle) || closure.len() >= MAX_CHAIN_DEPTH {
                    continue;
                }
                if let Some(interface) = self.resolve(&handle) {
                    let mut inherited = interface.interface_handles().to_vec();
                    inherited.reverse();
                    pending.extend(inherited);
                }
                push_unique(&mut closure, handle);
            }
            closure
        })
    }

    /// Every interface this type implements: declared, inherited from base types and inherited
    /// from other interfaces
    #[must_use]
    pub fn implemented_interfaces(&self) -> Vec<TypeRc> {
        self.implemented_handles()
            .iter()
            .filter_map(|interface| self.resolve(interface))
            .collect()
    }

    /// This type, its base types leaf first, then every implemented interface
    pub(crate) fn ancestors_and_interfaces(self: &Arc<Self>) -> Vec<TypeRc> {
        let mut ancestors = vec![self.clone()];
        ancestors.extend(self.base_type_hierarchy().into_iter().rev());
        ancestors.extend(self.implemented_interfaces());
        ancestors
    }

    /// Returns true if this type, one of its base types or one of its interfaces is `definition`
    /// or a construction of it
    pub(crate) fn derives_from_definition(&self, definition: &Type) -> bool {
        let same = |ty: &Type| {
            ty.definition_token().is_some()
                && ty.definition_token() == definition.definition_token()
                && ty.module.ptr_eq(&definition.module)
        };
        same(self)
            || self.base_type_hierarchy().iter().any(|base| same(base))
            || self.implemented_interfaces().iter().any(|interface| same(interface))
    }

    /// Returns true if `candidate` is this type or, for a generic definition, an instance of it
    fn is_same_or_instance_of(&self, candidate: &Type) -> bool {
        if *candidate == *self {
            return true;
        }
        match &candidate.handle {
            TypeHandle::Instance { definition, .. } => {
                self.is_generic_type_definition() && **definition == self.handle
            }
            _ => false,
        }
    }

    fn known_types(&self) -> Vec<TypeRc> {
        self.inner()
            .map(|provider| MetadataProvider::from_inner(provider).known_types())
            .unwrap_or_default()
    }

    /// Known types whose direct base type is this type or, for a generic definition, one of its
    /// instances. Computed on every call from the provider's known types.
    #[must_use]
    pub fn derived_types(&self) -> Vec<TypeRc> {
        self.known_types()
            .into_iter()
            .filter(|ty| {
                ty.base_type()
                    .is_some_and(|base| self.is_same_or_instance_of(&base))
            })
            .collect()
    }

    /// Known types that implement this interface, directly or through base types and other
    /// interfaces. Computed on every call from the provider's known types.
    #[must_use]
    pub fn implementing_types(&self) -> Vec<TypeRc> {
        if !self.is_interface() {
            return Vec::new();
        }
        self.known_types()
            .into_iter()
            .filter(|ty| {
                ty.implemented_interfaces()
                    .iter()
                    .any(|interface| self.is_same_or_instance_of(interface))
            })
            .collect()
    }

    /// Returns true if a value of `source` can be used where this type is expected.
    ///
    /// Walks the base chain and interfaces of `source`. Instances of the same generic definition
    /// are compared per parameter: invariant arguments must be equal, covariant arguments must
    /// be assignable and contravariant arguments assignable in reverse. Primitives additionally
    /// accept the implicit numeric widenings (`Int32` to `Int64`, `Single` to `Double`, ...).
    #[must_use]
    pub fn is_assignable_from(&self, source: &Type) -> bool {
        self.assignable_from(source, 0)
    }

    fn assignable_from(&self, source: &Type, depth: usize) -> bool {
        if *self == *source {
            return true;
        }
        if depth > MAX_ASSIGNABILITY_DEPTH {
            tracing::warn!(target = %self.full_name(), "assignability check too deep");
            return false;
        }
        let is_indirect = |ty: &Type| {
            matches!(
                ty.kind,
                TypeKind::Decorator(TypeModifier::Pointer | TypeModifier::ByRef)
            )
        };
        if is_indirect(self) || is_indirect(source) {
            return false;
        }
        if widens(source, self) {
            return true;
        }
        if self.is_core("System", "Object") {
            return true;
        }

        match (self.kind, source.kind) {
            (TypeKind::Decorator(TypeModifier::Nullable), _) => {
                if let Some(element) = self.element_type() {
                    if *element == *source {
                        return true;
                    }
                }
            }
            (
                TypeKind::Decorator(TypeModifier::Array(rank)),
                TypeKind::Decorator(TypeModifier::Array(source_rank)),
            ) if rank == source_rank => {
                if let (Some(element), Some(source_element)) =
                    (self.element_type(), source.element_type())
                {
                    return element == source_element
                        || (source_element.is_reference_type()
                            && element.assignable_from(&source_element, depth + 1));
                }
            }
            _ => {}
        }

        let Some(source) = source.resolve(&source.handle) else {
            return false;
        };
        source
            .ancestors_and_interfaces()
            .iter()
            .any(|ancestor| **ancestor == *self || self.variant_compatible(ancestor, depth + 1))
    }

    /// Compares two instances of the same generic definition under the variance of its
    /// parameters
    fn variant_compatible(&self, candidate: &Type, depth: usize) -> bool {
        let (
            TypeHandle::Instance {
                definition,
                arguments,
            },
            TypeHandle::Instance {
                definition: candidate_definition,
                arguments: candidate_arguments,
            },
        ) = (&self.handle, &candidate.handle)
        else {
            return false;
        };
        if definition != candidate_definition || arguments.len() != candidate_arguments.len() {
            return false;
        }
        let Some(generic) = self.resolve(definition) else {
            return false;
        };
        let parameters = generic.generic_parameters();

        arguments
            .iter()
            .zip(candidate_arguments)
            .enumerate()
            .all(|(position, (argument, candidate_argument))| {
                if argument == candidate_argument {
                    return true;
                }
                let variance = parameters
                    .get(position)
                    .map_or(Variance::Invariant, |parameter| parameter.variance());
                let (Some(argument), Some(candidate_argument)) =
                    (self.resolve(argument), self.resolve(candidate_argument))
                else {
                    return false;
                };
                match variance {
                    Variance::Invariant => false,
                    Variance::Covariant => argument.assignable_from(&candidate_argument, depth),
                    Variance::Contravariant => {
                        candidate_argument.assignable_from(&argument, depth)
                    }
                }
            })
    }

    /// Returns true if `other` is a strict ancestor of this type along the base chain.
    ///
    /// A generic definition as `other` matches any instance of it in the chain, so both
    /// `Derived<int>` and `Derived<T>` are subclasses of `Base<>`.
    #[must_use]
    pub fn is_subclass_of(&self, other: &Type) -> bool {
        if *self == *other {
            return false;
        }
        self.base_type_hierarchy()
            .iter()
            .any(|ancestor| other.is_same_or_instance_of(ancestor))
    }

    /// Returns true if `source` may stand in for this type when matching signatures.
    ///
    /// An open generic definition accepts itself and every construction of it; anything else,
    /// closed constructions included, accepts only an identical type.
    #[must_use]
    pub fn is_substitutable_by(&self, source: &Type) -> bool {
        if *self == *source {
            return true;
        }
        match (self.modifier(), source.modifier()) {
            (Some(modifier), Some(source_modifier)) if modifier == source_modifier => {
                return match (self.element_type(), source.element_type()) {
                    (Some(element), Some(source_element)) => {
                        element.is_substitutable_by(&source_element)
                    }
                    _ => false,
                };
            }
            (None, None) => {}
            _ => return false,
        }
        self.is_generic_type_definition() && self.is_same_or_instance_of(source)
    }
}

#[cfg(test)]
mod tests {
    use crate::metadata::{
        builder::{GenericParameterBuilder, ModuleBuilder, TypeBuilder},
        flags::GenericParamAttributes,
        module::ModuleRc,
        provider::MetadataProvider,
        signatures::TypeSignature,
        token::Token,
    };

    fn instance(definition: Token, arguments: Vec<TypeSignature>) -> TypeSignature {
        TypeSignature::GenericInst(Box::new(TypeSignature::Class(definition)), arguments)
    }

    /// `Animal`, `Dog : Animal, IPet`, `Base<T>`, `Derived<T> : Base<T>`, `IPet : IDisposable`,
    /// `Box<T>`
    fn zoo() -> (MetadataProvider, ModuleRc) {
        let mut module = ModuleBuilder::new("Zoo");
        let disposable = module.core_type("System", "IDisposable").unwrap();
        let pet = TypeBuilder::interface("Z", "IPet")
            .implements(TypeSignature::Class(disposable))
            .build(&mut module)
            .unwrap();
        let animal = TypeBuilder::class("Z", "Animal").build(&mut module).unwrap();
        TypeBuilder::class("Z", "Dog")
            .extends(TypeSignature::Class(animal))
            .implements(TypeSignature::Class(pet))
            .build(&mut module)
            .unwrap();
        let base = TypeBuilder::class("Z", "Base`1")
            .generic_parameter("T")
            .build(&mut module)
            .unwrap();
        TypeBuilder::class("Z", "Derived`1")
            .generic_parameter("T")
            .extends(instance(base, vec![TypeSignature::GenericParamType(0)]))
            .build(&mut module)
            .unwrap();
        TypeBuilder::class("Z", "Box`1")
            .generic_parameter("T")
            .build(&mut module)
            .unwrap();
        TypeBuilder::interface("Z", "IProducer`1")
            .generic_parameter(GenericParameterBuilder::new("T").covariant())
            .build(&mut module)
            .unwrap();

        let module = module.build().unwrap();
        let provider = MetadataProvider::new();
        provider.register_module(&module);
        (provider, module)
    }

    #[test]
    fn hierarchy() {
        let (provider, _module) = zoo();
        let dog = provider.find_type_by_full_name("Z.Dog").unwrap();
        let animal = provider.find_type_by_full_name("Z.Animal").unwrap();
        let object = provider.find_type_by_full_name("System.Object").unwrap();

        let chain: Vec<String> = dog
            .base_type_hierarchy()
            .iter()
            .map(|ty| ty.full_name().to_string())
            .collect();
        assert_eq!(chain, ["System.Object", "Z.Animal"]);

        let declared: Vec<String> = dog
            .interfaces()
            .iter()
            .map(|i| i.full_name().to_string())
            .collect();
        assert_eq!(declared, ["Z.IPet"]);
        let all: Vec<String> = dog
            .implemented_interfaces()
            .iter()
            .map(|i| i.full_name().to_string())
            .collect();
        assert_eq!(all, ["Z.IPet", "System.IDisposable"]);

        assert!(dog.is_subclass_of(&animal));
        assert!(dog.is_subclass_of(&object));
        assert!(!dog.is_subclass_of(&dog));
        assert!(!animal.is_subclass_of(&dog));
        assert_eq!(animal.derived_types(), [dog.clone()]);

        let pet = provider.find_type_by_full_name("Z.IPet").unwrap();
        assert_eq!(pet.implementing_types(), [dog.clone()]);
        assert!(pet.base_type().is_none());
    }

    #[test]
    fn assignability() {
        let (provider, _module) = zoo();
        let dog = provider.find_type_by_full_name("Z.Dog").unwrap();
        let animal = provider.find_type_by_full_name("Z.Animal").unwrap();
        let pet = provider.find_type_by_full_name("Z.IPet").unwrap();
        let object = provider.find_type_by_full_name("System.Object").unwrap();
        let int = provider.find_type_by_full_name("System.Int32").unwrap();
        let long = provider.find_type_by_full_name("System.Int64").unwrap();

        assert!(animal.is_assignable_from(&dog));
        assert!(pet.is_assignable_from(&dog));
        assert!(object.is_assignable_from(&pet));
        assert!(!dog.is_assignable_from(&animal));

        assert!(long.is_assignable_from(&int));
        assert!(!int.is_assignable_from(&long));
        assert!(object.is_assignable_from(&int));

        let nullable = int.make_nullable_type().unwrap();
        assert!(nullable.is_assignable_from(&int));
        assert!(!int.is_assignable_from(&nullable));

        let dogs = dog.make_array_type(0).unwrap();
        let animals = animal.make_array_type(0).unwrap();
        assert!(animals.is_assignable_from(&dogs));
        assert!(!dogs.is_assignable_from(&animals));
        let ints = int.make_array_type(0).unwrap();
        let longs = long.make_array_type(0).unwrap();
        assert!(!longs.is_assignable_from(&ints));

        let by_ref = dog.make_by_ref_type().unwrap();
        assert!(!object.is_assignable_from(&by_ref));
    }

    #[test]
    fn variance() {
        let (provider, _module) = zoo();
        let dog = provider.find_type_by_full_name("Z.Dog").unwrap();
        let animal = provider.find_type_by_full_name("Z.Animal").unwrap();

        let producer = provider.find_type_by_full_name("Z.IProducer`1").unwrap();
        let of_dog = producer.make_generic_type(&[dog.clone()]).unwrap();
        let of_animal = producer.make_generic_type(&[animal.clone()]).unwrap();
        assert!(of_animal.is_assignable_from(&of_dog));
        assert!(!of_dog.is_assignable_from(&of_animal));

        let boxed = provider.find_type_by_full_name("Z.Box`1").unwrap();
        let box_dog = boxed.make_generic_type(&[dog.clone()]).unwrap();
        let box_animal = boxed.make_generic_type(&[animal.clone()]).unwrap();
        assert!(!box_animal.is_assignable_from(&box_dog));
        assert!(box_animal.is_assignable_from(&box_animal));

        let comparable = provider.find_type_by_full_name("System.IComparable`1").unwrap();
        let compare_animal = comparable.make_generic_type(&[animal.clone()]).unwrap();
        let compare_dog = comparable.make_generic_type(&[dog]).unwrap();
        assert!(compare_dog.is_assignable_from(&compare_animal));
        assert!(!compare_animal.is_assignable_from(&compare_dog));
    }

    #[test]
    fn generic_subclasses_and_substitution() {
        let (provider, _module) = zoo();
        let int = provider.find_type_by_full_name("System.Int32").unwrap();
        let long = provider.find_type_by_full_name("System.Int64").unwrap();
        let base = provider.find_type_by_full_name("Z.Base`1").unwrap();
        let derived = provider.find_type_by_full_name("Z.Derived`1").unwrap();

        let derived_int = derived.make_generic_type(&[int.clone()]).unwrap();
        let base_int = base.make_generic_type(&[int.clone()]).unwrap();
        let base_long = base.make_generic_type(&[long.clone()]).unwrap();

        assert_eq!(derived_int.base_type().unwrap(), base_int);
        assert!(derived_int.is_subclass_of(&base));
        assert!(derived_int.is_subclass_of(&base_int));
        assert!(!derived_int.is_subclass_of(&base_long));
        assert!(derived.is_subclass_of(&base));
        assert!(base_int.is_assignable_from(&derived_int));
        assert_eq!(base.derived_types(), [derived.clone()]);

        let boxed = provider.find_type_by_full_name("Z.Box`1").unwrap();
        let box_int = boxed.make_generic_type(&[int.clone()]).unwrap();
        let box_long = boxed.make_generic_type(&[long]).unwrap();
        assert!(boxed.is_substitutable_by(&box_int));
        assert!(boxed.is_substitutable_by(&boxed));
        assert!(!box_int.is_substitutable_by(&boxed));
        assert!(box_int.is_substitutable_by(&box_int));
        assert!(!box_int.is_substitutable_by(&box_long));

        let open_array = boxed.make_array_type(0).unwrap();
        assert!(open_array.is_substitutable_by(&box_int.make_array_type(0).unwrap()));
        assert!(!open_array.is_substitutable_by(&box_int));
    }

    #[test]
    fn parameter_bases() {
        let mut module = ModuleBuilder::new("Bases");
        let value_type = module.core_type("System", "ValueType").unwrap();
        let animal = TypeBuilder::class("Z", "Animal").build(&mut module).unwrap();
        TypeBuilder::class("Z", "Pen`3")
            .generic_parameter("T")
            .generic_parameter(
                GenericParameterBuilder::new("U").constraint(TypeSignature::Class(animal)),
            )
            .generic_parameter(
                GenericParameterBuilder::new("V")
                    .flags(GenericParamAttributes::NOT_NULLABLE_VALUE_TYPE_CONSTRAINT)
                    .constraint(TypeSignature::Class(value_type)),
            )
            .build(&mut module)
            .unwrap();
        let module = module.build().unwrap();
        let provider = MetadataProvider::new();
        provider.register_module(&module);

        let pen = provider.find_type_by_full_name("Z.Pen`3").unwrap();
        let parameters = pen.generic_parameters();
        assert_eq!(parameters[0].base_type().unwrap().full_name(), "System.Object");
        assert_eq!(parameters[1].base_type().unwrap().full_name(), "Z.Animal");
        assert_eq!(parameters[2].base_type().unwrap().full_name(), "System.ValueType");

        let animal = provider.find_type_by_full_name("Z.Animal").unwrap();
        assert!(animal.is_assignable_from(&parameters[1]));
        assert!(!animal.is_assignable_from(&parameters[0]));
    }
}
