//! Generic shape of types: parameters, arguments, variance and constraints.
//!
//! Nested types redeclare the parameters of their enclosing types, so the full parameter list of
//! `Box<T>.Inner<U, V>` is `T, U, V`. The parameters a nesting level adds itself are described by
//! [`Type::own_generic_parameter_range`]; [`Type::type_parameters`] returns just those.

use std::sync::Arc;

use crate::{
    metadata::{
        binding::Scope,
        flags::{GenericParamAttributes, Visibility, SPECIAL_CONSTRAINT_MASK, VARIANCE_MASK},
        handle::{GenericOwner, MethodHandle, TypeHandle},
        tables::TableId,
        token::Token,
        typesystem::{logged, MethodRc, Type, TypeKind, TypeModifier, TypeRc},
    },
    Error, Result,
};

/// Subtyping direction of a type parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Variance {
    /// Arguments must be identical
    #[default]
    Invariant,
    /// `out T`: follows the argument's subtyping
    Covariant,
    /// `in T`: reverses the argument's subtyping
    Contravariant,
}

/// Replaces every occurrence of `parameter` in `handle`
fn replace_parameter(
    handle: &TypeHandle,
    parameter: &TypeHandle,
    replacement: &TypeHandle,
) -> TypeHandle {
    if handle == parameter {
        return replacement.clone();
    }
    match handle {
        TypeHandle::Instance {
            definition,
            arguments,
        } => TypeHandle::Instance {
            definition: definition.clone(),
            arguments: arguments
                .iter()
                .map(|argument| replace_parameter(argument, parameter, replacement))
                .collect(),
        },
        TypeHandle::Array { element, rank } => TypeHandle::Array {
            element: Box::new(replace_parameter(element, parameter, replacement)),
            rank: *rank,
        },
        TypeHandle::Pointer(element) => {
            TypeHandle::Pointer(Box::new(replace_parameter(element, parameter, replacement)))
        }
        TypeHandle::ByRef(element) => {
            TypeHandle::ByRef(Box::new(replace_parameter(element, parameter, replacement)))
        }
        other => other.clone(),
    }
}

impl Type {
    /// Length of the full parameter list of a definition or instance
    pub(crate) fn parameter_count(&self) -> usize {
        match (self.definition_token(), self.module()) {
            (Some(token), Some(module)) => module.generic_params(token).len(),
            _ => 0,
        }
    }

    /// Returns true for an open generic type definition (`List<T>`)
    #[must_use]
    pub fn is_generic_type_definition(&self) -> bool {
        matches!(self.handle, TypeHandle::Definition { .. }) && self.parameter_count() > 0
    }

    /// Returns true for a constructed generic type (`List<int>`, also `List<U>` inside another
    /// generic declaration)
    #[must_use]
    pub fn is_constructed_generic_type(&self) -> bool {
        matches!(self.handle, TypeHandle::Instance { .. })
    }

    /// Returns true if a generic parameter is still free somewhere in this type
    #[must_use]
    pub fn contains_generic_parameters(&self) -> bool {
        self.is_generic_type_definition() || self.handle.contains_parameters()
    }

    /// The generic type definition of a constructed type; a definition returns itself.
    #[must_use]
    pub fn generic_type_definition(self: &Arc<Self>) -> Option<TypeRc> {
        match &self.handle {
            TypeHandle::Instance { definition, .. } => self.resolve(definition),
            TypeHandle::Definition { .. } if self.parameter_count() > 0 => Some(self.clone()),
            _ => None,
        }
    }

    /// The full parameter list of the generic definition, inherited parameters first
    #[must_use]
    pub fn generic_parameters(&self) -> Vec<TypeRc> {
        let (Some(provider), Some(module)) = (self.inner(), self.module()) else {
            return Vec::new();
        };
        if self.definition_token().is_none() {
            return Vec::new();
        }
        provider
            .own_parameters(&module, self.row)
            .iter()
            .filter_map(|parameter| self.resolve(parameter))
            .collect()
    }

    /// The parameters declared at this nesting level
    #[must_use]
    pub fn type_parameters(&self) -> Vec<TypeRc> {
        let (inherited, own) = self.own_generic_parameter_range();
        self.generic_parameters()
            .into_iter()
            .skip(inherited)
            .take(own)
            .collect()
    }

    /// Type arguments of a constructed type, for its full parameter list
    #[must_use]
    pub fn type_arguments(&self) -> Vec<TypeRc> {
        self.argument_handles()
            .iter()
            .filter_map(|argument| self.resolve(argument))
            .collect()
    }

    /// Offset and count of the parameters this nesting level declares within the full list.
    ///
    /// For `Box<T>.Inner<U, V>` this is `(1, 2)`; a non-generic type nested in it reports `(3, 0)`.
    #[must_use]
    pub fn own_generic_parameter_range(&self) -> (usize, usize) {
        let total = self.parameter_count();
        let inherited = match (self.module(), self.definition_token()) {
            (Some(module), Some(_)) => module.enclosing_type(self.row).map_or(0, |enclosing| {
                module
                    .generic_params(Token::from_parts(TableId::TypeDef, enclosing))
                    .len()
            }),
            _ => 0,
        }
        .min(total);
        (inherited, total - inherited)
    }

    /// The type or method declaring this generic parameter
    #[must_use]
    pub fn generic_owner(&self) -> Option<GenericOwner> {
        match &self.handle {
            TypeHandle::Parameter { owner, .. } => Some(*owner),
            _ => None,
        }
    }

    /// Position of a generic parameter within the parameters its owner declares itself
    #[must_use]
    pub fn generic_parameter_position(&self) -> Option<usize> {
        let TypeHandle::Parameter { owner, number } = &self.handle else {
            return None;
        };
        match owner {
            GenericOwner::Type { row, .. } => {
                let module = self.module()?;
                let inherited = module.enclosing_type(*row).map_or(0, |enclosing| {
                    module
                        .generic_params(Token::from_parts(TableId::TypeDef, enclosing))
                        .len()
                });
                Some((*number as usize).saturating_sub(inherited))
            }
            GenericOwner::Method { .. } => Some(*number as usize),
        }
    }

    /// The generic method declaring a method-level parameter
    #[must_use]
    pub fn declaring_method(&self) -> Option<MethodRc> {
        let GenericOwner::Method { module: id, row } = self.generic_owner()? else {
            return None;
        };
        let module = self.module()?;
        let type_row = module.declaring_type(Token::from_parts(TableId::MethodDef, row))?;
        let handle = MethodHandle {
            declaring: TypeHandle::definition(id, type_row),
            module: id,
            row,
            arguments: Vec::new(),
        };
        logged(self.inner()?.get_method(&handle), &self.name)
    }

    fn parameter_flags(&self) -> GenericParamAttributes {
        if self.kind != TypeKind::GenericParameter {
            return GenericParamAttributes::empty();
        }
        self.module()
            .and_then(|module| module.generic_param(self.row).map(|param| param.flags))
            .unwrap_or_default()
    }

    /// Variance of a type-level parameter; method-level parameters are always invariant
    #[must_use]
    pub fn variance(&self) -> Variance {
        if !matches!(self.generic_owner(), Some(GenericOwner::Type { .. })) {
            return Variance::Invariant;
        }
        match self.parameter_flags().bits() & VARIANCE_MASK {
            0x1 => Variance::Covariant,
            0x2 => Variance::Contravariant,
            _ => Variance::Invariant,
        }
    }

    /// Special constraints of a generic parameter (`class`, `struct`, `new()`, `allows ref struct`)
    #[must_use]
    pub fn constraint_flags(&self) -> GenericParamAttributes {
        GenericParamAttributes::from_bits_truncate(
            self.parameter_flags().bits() & SPECIAL_CONSTRAINT_MASK,
        )
    }

    fn owner_scope(&self) -> Option<Scope> {
        let module = self.module()?;
        Some(match self.generic_owner()? {
            GenericOwner::Type { row, .. } => Scope::of_type(row),
            GenericOwner::Method { row, .. } => Scope::of_method(
                &module,
                module.declaring_type(Token::from_parts(TableId::MethodDef, row)),
                row,
            ),
        })
    }

    pub(crate) fn constraint_handles(&self) -> Vec<TypeHandle> {
        let (Some(provider), Some(module), Some(scope)) =
            (self.inner(), self.module(), self.owner_scope())
        else {
            return Vec::new();
        };
        if self.kind != TypeKind::GenericParameter {
            return Vec::new();
        }
        module
            .constraints(self.row)
            .iter()
            .filter_map(|token| logged(provider.type_token(&module, scope, *token), &self.name))
            .collect()
    }

    /// The base class and interfaces a generic parameter is constrained to
    #[must_use]
    pub fn type_constraints(&self) -> Vec<TypeRc> {
        self.constraint_handles()
            .iter()
            .filter_map(|constraint| self.resolve(constraint))
            .collect()
    }

    /// Returns true if `candidate` is a valid argument for this generic parameter.
    ///
    /// Checks the special constraints against the nature of the candidate, then every type
    /// constraint with this parameter replaced by the candidate (so `T : IComparable<T>` is
    /// checked as `IComparable<candidate>`).
    #[must_use]
    pub fn is_satisfiable_by(&self, candidate: &Type) -> bool {
        if self.kind != TypeKind::GenericParameter {
            return false;
        }
        if matches!(
            candidate.kind,
            TypeKind::Decorator(TypeModifier::Pointer | TypeModifier::ByRef)
        ) {
            return false;
        }

        let flags = self.constraint_flags();
        if flags.contains(GenericParamAttributes::REFERENCE_TYPE_CONSTRAINT)
            && !candidate.is_reference_type()
        {
            return false;
        }
        if flags.contains(GenericParamAttributes::NOT_NULLABLE_VALUE_TYPE_CONSTRAINT)
            && (!candidate.is_value_type()
                || candidate.kind == TypeKind::Decorator(TypeModifier::Nullable))
        {
            return false;
        }
        if flags.contains(GenericParamAttributes::DEFAULT_CONSTRUCTOR_CONSTRAINT)
            && !candidate.has_default_constructor()
        {
            return false;
        }
        if candidate.is_byref_like()
            && !flags.contains(GenericParamAttributes::ALLOW_BY_REF_LIKE)
        {
            return false;
        }

        let Some(provider) = self.inner() else {
            return false;
        };
        self.constraint_handles().iter().all(|constraint| {
            let bound = provider.canonical_type(&replace_parameter(
                constraint,
                &self.handle,
                &candidate.handle,
            ));
            let Some(bound) = self.resolve(&bound) else {
                return false;
            };
            if bound.handle.contains_parameters() {
                // Constraints over other free parameters only pin the generic definition
                return candidate.derives_from_definition(&bound);
            }
            bound.is_assignable_from(candidate)
        })
    }

    fn has_default_constructor(&self) -> bool {
        match self.kind {
            TypeKind::GenericParameter => self.constraint_flags().intersects(
                GenericParamAttributes::DEFAULT_CONSTRUCTOR_CONSTRAINT
                    | GenericParamAttributes::NOT_NULLABLE_VALUE_TYPE_CONSTRAINT,
            ),
            _ if self.is_value_type() => true,
            TypeKind::Class => {
                !self.is_abstract()
                    && self.constructors().iter().any(|ctor| {
                        !ctor.is_static()
                            && ctor.visibility() == Visibility::Public
                            && ctor.parameter_types().is_empty()
                    })
            }
            _ => false,
        }
    }

    /// Constructs this generic type definition over `arguments`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] if this is not a generic type definition or the number
    /// of arguments does not match its full parameter list.
    pub fn make_generic_type(&self, arguments: &[TypeRc]) -> Result<TypeRc> {
        if !self.is_generic_type_definition() {
            return Err(Error::InvalidArgument(format!(
                "{} is not a generic type definition",
                self.full_name()
            )));
        }
        let expected = self.parameter_count();
        if arguments.len() != expected {
            return Err(Error::InvalidArgument(format!(
                "{} expects {} type arguments, got {}",
                self.full_name(),
                expected,
                arguments.len()
            )));
        }

        let provider = self.inner().ok_or(Error::Unloaded)?;
        provider.get_type(&TypeHandle::Instance {
            definition: Box::new(self.handle.clone()),
            arguments: arguments
                .iter()
                .map(|argument| argument.handle.clone())
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{
        builder::{GenericParameterBuilder, MethodBuilder, ModuleBuilder, TypeBuilder},
        provider::MetadataProvider,
        signatures::TypeSignature,
    };

    #[test]
    fn nested_parameter_ranges() {
        let mut module = ModuleBuilder::new("Ranges");
        let boxed = TypeBuilder::class("N", "Box`1")
            .generic_parameter("T")
            .build(&mut module)
            .unwrap();
        let inner = TypeBuilder::class("", "Inner`2")
            .nested_in(boxed)
            .generic_parameter("U")
            .generic_parameter("V")
            .build(&mut module)
            .unwrap();
        TypeBuilder::class("", "Deep")
            .nested_in(inner)
            .build(&mut module)
            .unwrap();
        let module = module.build().unwrap();
        let provider = MetadataProvider::new();
        provider.register_module(&module);

        let boxed = provider.find_type_by_full_name("N.Box`1").unwrap();
        let inner = provider.find_type_by_full_name("N.Box`1+Inner`2").unwrap();
        let deep = provider
            .find_type_by_full_name("N.Box`1+Inner`2+Deep")
            .unwrap();

        assert_eq!(boxed.own_generic_parameter_range(), (0, 1));
        assert_eq!(inner.own_generic_parameter_range(), (1, 2));
        assert_eq!(deep.own_generic_parameter_range(), (3, 0));
        assert!(deep.is_generic_type_definition());
        assert!(deep.type_parameters().is_empty());

        let names: Vec<String> = inner
            .type_parameters()
            .iter()
            .map(|param| param.name().to_string())
            .collect();
        assert_eq!(names, ["U", "V"]);

        // T seen from Deep is the parameter Box declares
        let inherited = &deep.generic_parameters()[0];
        assert_eq!(inherited, &boxed.generic_parameters()[0]);
        assert_eq!(inherited.declaring_type().unwrap(), boxed);
        assert_eq!(inherited.generic_parameter_position(), Some(0));
        assert_eq!(inner.generic_parameters()[2].generic_parameter_position(), Some(1));
    }

    #[test]
    fn variance_and_constraints() {
        let provider = MetadataProvider::new();
        let enumerable = provider
            .find_type_by_full_name("System.Collections.Generic.IEnumerable`1")
            .unwrap();
        let comparable = provider.find_type_by_full_name("System.IComparable`1").unwrap();
        let nullable = provider.find_type_by_full_name("System.Nullable`1").unwrap();

        assert_eq!(enumerable.type_parameters()[0].variance(), Variance::Covariant);
        assert_eq!(comparable.type_parameters()[0].variance(), Variance::Contravariant);

        let value = &nullable.type_parameters()[0];
        assert_eq!(value.variance(), Variance::Invariant);
        assert!(value
            .constraint_flags()
            .contains(GenericParamAttributes::NOT_NULLABLE_VALUE_TYPE_CONSTRAINT));
        assert_eq!(value.type_constraints()[0].full_name(), "System.ValueType");

        let int = provider.find_type_by_full_name("System.Int32").unwrap();
        let string = provider.find_type_by_full_name("System.String").unwrap();
        assert!(value.is_satisfiable_by(&int));
        assert!(!value.is_satisfiable_by(&string));

        let nullable_int = nullable.make_generic_type(&[int.clone()]).unwrap();
        assert!(!value.is_satisfiable_by(&nullable_int));
        assert_eq!(nullable_int.full_name(), "System.Nullable`1[System.Int32]");
        assert_eq!(nullable_int.generic_type_definition().unwrap(), nullable);

        assert!(matches!(
            int.make_generic_type(&[]),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            nullable.make_generic_type(&[int.clone(), int]),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn self_referencing_constraint() {
        let mut module = ModuleBuilder::new("Constraints");
        let comparable = module.core_type("System", "IComparable`1").unwrap();
        let disposable = module.core_type("System", "IDisposable").unwrap();
        let sorted = TypeBuilder::class("N", "Sorted`1")
            .generic_parameter(
                GenericParameterBuilder::new("T").constraint(TypeSignature::GenericInst(
                    Box::new(TypeSignature::Class(comparable)),
                    vec![TypeSignature::GenericParamType(0)],
                )),
            )
            .build(&mut module)
            .unwrap();
        let pool = TypeBuilder::class("N", "Pool`1")
            .generic_parameter(
                GenericParameterBuilder::new("T")
                    .flags(
                        GenericParamAttributes::REFERENCE_TYPE_CONSTRAINT
                            | GenericParamAttributes::DEFAULT_CONSTRUCTOR_CONSTRAINT,
                    )
                    .constraint(TypeSignature::Class(disposable)),
            )
            .build(&mut module)
            .unwrap();
        let resource = TypeBuilder::class("N", "Resource")
            .implements(TypeSignature::Class(disposable))
            .build(&mut module)
            .unwrap();
        MethodBuilder::constructor()
            .build(&mut module, resource)
            .unwrap();
        let locked = TypeBuilder::class("N", "Locked")
            .implements(TypeSignature::Class(disposable))
            .build(&mut module)
            .unwrap();
        MethodBuilder::constructor()
            .parameter(("key", TypeSignature::String))
            .build(&mut module, locked)
            .unwrap();
        let module = module.build().unwrap();
        let provider = MetadataProvider::new();
        provider.register_module(&module);

        let sorted = provider.type_definition(&module, sorted.row()).unwrap();
        let pool = provider.type_definition(&module, pool.row()).unwrap();
        let int = provider.find_type_by_full_name("System.Int32").unwrap();
        let object = provider.find_type_by_full_name("System.Object").unwrap();

        let t = &sorted.type_parameters()[0];
        assert!(t.is_satisfiable_by(&int));
        assert!(!t.is_satisfiable_by(&object));

        let t = &pool.type_parameters()[0];
        let resource = provider.find_type_by_full_name("N.Resource").unwrap();
        let locked = provider.find_type_by_full_name("N.Locked").unwrap();
        assert!(t.is_satisfiable_by(&resource));
        assert!(!t.is_satisfiable_by(&locked));
        assert!(!t.is_satisfiable_by(&int));
        assert!(!t.is_satisfiable_by(&resource.make_by_ref_type().unwrap()));
    }
}
