//! The type and member graph.
//!
//! Every [`Type`] is materialized from a canonical [`TypeHandle`] by the
//! [`crate::metadata::provider::MetadataProvider`] and shared as a [`TypeRc`]. Types never own
//! each other: relationships (base type, interfaces, members, nested types) are stored as handles
//! and looked up through the provider on access, so the graph can be cyclic without reference
//! cycles.
//!
//! # Variants
//!
//! | [`TypeKind`]            | Handle                          |
//! |-------------------------|---------------------------------|
//! | `Primitive`             | core `System` numeric/bool/char |
//! | `Class`, `Interface`    | definitions and instances       |
//! | `Struct`, `Enum`        | value type definitions          |
//! | `Delegate`              | `MulticastDelegate` subclasses  |
//! | `Decorator(modifier)`   | arrays, pointers, by-refs and `Nullable<T>` |
//! | `GenericParameter`      | type and method parameters      |
//!
//! Relationship lists are computed on first access and cached in the object; they are pure
//! functions of immutable metadata, so concurrent first accesses at most duplicate work.

mod decorator;
mod extensions;
mod generics;
mod inheritance;
mod members;
mod relations;

pub use extensions::ExtensionProperty;
pub use generics::Variance;
pub use inheritance::get_inherited_member;
pub use members::{
    Event, EventRc, Field, FieldRc, Member, Method, MethodKind, MethodRc, Parameter, ParameterRc,
    Property, PropertyRc, RefKind,
};

use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::{Arc, OnceLock, Weak},
};

use crate::{
    metadata::{
        binding::Scope,
        coderef,
        corlib::{self, PRIMITIVE_TYPES},
        flags::{GenericParamAttributes, TypeAttributes, Visibility},
        handle::{GenericOwner, Handle, TypeHandle},
        module::{Module, ModuleRc},
        provider::{MetadataProvider, ProviderInner},
        tables::{TableId, TypeDefRow},
        token::Token,
    },
    Error, Result,
};

/// A reference counted type
pub type TypeRc = Arc<Type>;

/// Upper bound for walks along base, enclosing and interface chains
pub(crate) const MAX_CHAIN_DEPTH: usize = 256;

/// The wrapper a decorator type applies to its element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeModifier {
    /// An array of the given rank; 0 is a single-dimensional, zero-based vector
    Array(u32),
    /// An unmanaged pointer
    Pointer,
    /// A managed reference
    ByRef,
    /// `System.Nullable<T>` over a value type
    Nullable,
}

/// The variant of a [`Type`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum TypeKind {
    Primitive,
    Class,
    Interface,
    Struct,
    Enum,
    Delegate,
    Decorator(TypeModifier),
    GenericParameter,
}

/// Logs a failed lookup and turns it into an absence.
pub(crate) fn logged<T>(result: Result<T>, context: &str) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(error) => {
            tracing::warn!(%error, context, "metadata lookup failed");
            None
        }
    }
}

/// A type of the metadata model.
pub struct Type {
    handle: TypeHandle,
    kind: TypeKind,
    name: String,
    namespace: String,
    flags: TypeAttributes,
    /// TypeDef row of definitions and instances, GenericParam row of parameters
    row: u32,
    module: Weak<Module>,
    provider: Weak<ProviderInner>,
    base: OnceLock<Option<TypeHandle>>,
    interfaces: OnceLock<Vec<TypeHandle>>,
    implemented: OnceLock<Vec<TypeHandle>>,
    full_name: OnceLock<String>,
}

impl Type {
    #[allow(clippy::too_many_arguments)]
    fn new(
        provider: &Arc<ProviderInner>,
        handle: TypeHandle,
        kind: TypeKind,
        name: String,
        namespace: String,
        flags: TypeAttributes,
        row: u32,
        module: Weak<Module>,
    ) -> Self {
        Type {
            handle,
            kind,
            name,
            namespace,
            flags,
            row,
            module,
            provider: Arc::downgrade(provider),
            base: OnceLock::new(),
            interfaces: OnceLock::new(),
            implemented: OnceLock::new(),
            full_name: OnceLock::new(),
        }
    }

    /// Builds the type object of a canonical handle
    pub(crate) fn load(provider: &Arc<ProviderInner>, handle: &TypeHandle) -> Result<Type> {
        match handle {
            TypeHandle::Definition { module, row } => {
                let module = provider.module(*module)?;
                Self::load_definition(provider, &module, *row)
            }
            TypeHandle::Instance {
                definition,
                arguments,
            } => {
                let generic = provider.get_type(definition)?;
                if let Some(module) = generic.module() {
                    let expected = module
                        .generic_params(Token::from_parts(TableId::TypeDef, generic.row))
                        .len();
                    if expected != arguments.len() {
                        return Err(Error::InvalidArgument(format!(
                            "{} expects {} type arguments, got {}",
                            generic.full_name(),
                            expected,
                            arguments.len()
                        )));
                    }
                }

                let kind = if provider.is_core_type(definition, "System", "Nullable`1") {
                    TypeKind::Decorator(TypeModifier::Nullable)
                } else {
                    generic.kind
                };
                let ty = Type::new(
                    provider,
                    handle.clone(),
                    kind,
                    generic.name.clone(),
                    generic.namespace.clone(),
                    generic.flags,
                    generic.row,
                    generic.module.clone(),
                );
                let base = generic
                    .base_handle()
                    .map(|base| provider.canonical_type(&base.substitute(arguments, &[])));
                let _ = ty.base.set(base);
                Ok(ty)
            }
            TypeHandle::Parameter { owner, number } => {
                let module = provider.module(owner.module())?;
                let param_row = module
                    .generic_params(owner.token())
                    .get(*number as usize)
                    .copied()
                    .ok_or(Error::TokenNotFound(owner.token()))?;
                let param = module
                    .generic_param(param_row)
                    .ok_or(Error::TokenNotFound(owner.token()))?;
                Ok(Type::new(
                    provider,
                    handle.clone(),
                    TypeKind::GenericParameter,
                    param.name.clone(),
                    String::new(),
                    TypeAttributes::empty(),
                    param_row,
                    Arc::downgrade(&module),
                ))
            }
            TypeHandle::Array { element, rank } => {
                let suffix = match rank {
                    0 => "[]".to_string(),
                    1 => "[*]".to_string(),
                    rank => format!("[{}]", ",".repeat(*rank as usize - 1)),
                };
                let ty = Self::load_decorator(
                    provider,
                    handle,
                    element,
                    TypeModifier::Array(*rank),
                    &suffix,
                )?;
                let _ = ty.base.set(provider.core_definition("System", "Array").ok());
                Ok(ty)
            }
            TypeHandle::Pointer(element) => {
                Self::load_decorator(provider, handle, element, TypeModifier::Pointer, "*")
            }
            TypeHandle::ByRef(element) => {
                Self::load_decorator(provider, handle, element, TypeModifier::ByRef, "&")
            }
            TypeHandle::Named {
                assembly,
                full_name,
            } => {
                tracing::warn!(%assembly, %full_name, "type is not resident, using a placeholder");
                let full_name: &str = full_name;
                let outer = full_name.split('+').next().unwrap_or(full_name);
                let namespace = outer.rsplit_once('.').map_or("", |(namespace, _)| namespace);
                let name = full_name
                    .rsplit(['+', '.'])
                    .next()
                    .unwrap_or(full_name)
                    .to_string();
                let ty = Type::new(
                    provider,
                    handle.clone(),
                    TypeKind::Class,
                    name,
                    namespace.to_string(),
                    TypeAttributes::PUBLIC,
                    0,
                    Weak::new(),
                );
                let _ = ty.base.set(None);
                Ok(ty)
            }
            TypeHandle::Reference { module, row } => {
                tracing::warn!(%module, row, "unbound type reference");
                Err(Error::TokenNotFound(Token::from_parts(TableId::TypeRef, *row)))
            }
            TypeHandle::FunctionPointer => Err(Error::UnsupportedMember(
                "function pointer types have no metadata object".to_string(),
            )),
            TypeHandle::TypedReference => Err(Error::UnsupportedMember(
                "typed references have no metadata object".to_string(),
            )),
        }
    }

    fn load_definition(provider: &Arc<ProviderInner>, module: &ModuleRc, row: u32) -> Result<Type> {
        let def = module
            .type_def(row)
            .ok_or(Error::TokenNotFound(Token::from_parts(TableId::TypeDef, row)))?;
        let base = if def.extends.is_null() {
            None
        } else {
            Some(provider.type_token(module, Scope::of_type(row), def.extends)?)
        };
        let kind = Self::classify(provider, module, def, base.as_ref());

        let mut outermost = row;
        for _ in 0..MAX_CHAIN_DEPTH {
            match module.enclosing_type(outermost) {
                Some(enclosing) => outermost = enclosing,
                None => break,
            }
        }
        let namespace = module
            .type_def(outermost)
            .map(|outer| outer.namespace.clone())
            .unwrap_or_default();

        let ty = Type::new(
            provider,
            TypeHandle::Definition {
                module: module.id(),
                row,
            },
            kind,
            def.name.clone(),
            namespace,
            def.flags,
            row,
            Arc::downgrade(module),
        );
        let _ = ty.base.set(base);
        Ok(ty)
    }

    fn classify(
        provider: &ProviderInner,
        module: &ModuleRc,
        def: &TypeDefRow,
        base: Option<&TypeHandle>,
    ) -> TypeKind {
        if def.flags.contains(TypeAttributes::INTERFACE) {
            return TypeKind::Interface;
        }

        let in_core = corlib::core_library().is_ok_and(|core| core.id() == module.id());
        let is_core_system = |name: &str| in_core && def.namespace == "System" && def.name == name;
        if in_core && def.namespace == "System" && PRIMITIVE_TYPES.contains(&def.name.as_str()) {
            return TypeKind::Primitive;
        }

        let Some(base) = base else {
            return TypeKind::Class;
        };
        if provider.is_core_type(base, "System", "Enum") {
            TypeKind::Enum
        } else if provider.is_core_type(base, "System", "ValueType") && !is_core_system("Enum") {
            TypeKind::Struct
        } else if (provider.is_core_type(base, "System", "MulticastDelegate")
            || provider.is_core_type(base, "System", "Delegate"))
            && !is_core_system("MulticastDelegate")
        {
            TypeKind::Delegate
        } else {
            TypeKind::Class
        }
    }

    fn load_decorator(
        provider: &Arc<ProviderInner>,
        handle: &TypeHandle,
        element: &TypeHandle,
        modifier: TypeModifier,
        suffix: &str,
    ) -> Result<Type> {
        let element = provider.get_type(element)?;
        let flags = match modifier {
            TypeModifier::Array(_) => {
                TypeAttributes::PUBLIC | TypeAttributes::SEALED | TypeAttributes::SERIALIZABLE
            }
            _ => TypeAttributes::empty(),
        };
        let ty = Type::new(
            provider,
            handle.clone(),
            TypeKind::Decorator(modifier),
            format!("{}{}", element.name, suffix),
            element.namespace.clone(),
            flags,
            0,
            element.module.clone(),
        );
        if !matches!(modifier, TypeModifier::Array(_)) {
            let _ = ty.base.set(None);
        }
        Ok(ty)
    }

    pub(crate) fn inner(&self) -> Option<Arc<ProviderInner>> {
        self.provider.upgrade()
    }

    /// Looks `handle` up in this type's provider, logging failures.
    pub(crate) fn resolve(&self, handle: &TypeHandle) -> Option<TypeRc> {
        logged(self.inner()?.get_type(handle), &self.name)
    }

    /// The canonical handle of this type
    #[must_use]
    pub fn handle(&self) -> &TypeHandle {
        &self.handle
    }

    /// The variant of this type
    #[must_use]
    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// Simple name, generic arity suffix included (`List`1`)
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Namespace; nested types report the namespace of their outermost enclosing type
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Full name: namespace, enclosing types separated by `+`, type arguments in brackets
    /// (`N.Outer+Inner`, ``System.Nullable`1[System.Int32]``).
    pub fn full_name(&self) -> &str {
        self.full_name.get_or_init(|| match self.inner() {
            Some(provider) => display_name(&provider, &self.handle),
            None => self.name.clone(),
        })
    }

    /// The `TypeDef` flags; decorators and parameters report synthesized flags
    #[must_use]
    pub fn flags(&self) -> TypeAttributes {
        self.flags
    }

    /// Declared accessibility
    #[must_use]
    pub fn visibility(&self) -> Visibility {
        match self.kind {
            TypeKind::Decorator(_) | TypeKind::GenericParameter => self
                .element_type()
                .map_or(Visibility::Public, |element| element.visibility()),
            _ => self.flags.visibility(),
        }
    }

    /// The module this type is defined in; `None` for types of assemblies that are not resident
    /// and once the module has been unloaded
    #[must_use]
    pub fn module(&self) -> Option<ModuleRc> {
        self.module.upgrade()
    }

    /// The provider this type was materialized by
    #[must_use]
    pub fn provider(&self) -> Option<MetadataProvider> {
        self.inner().map(MetadataProvider::from_inner)
    }

    /// Returns true if this type's module is no longer resident
    #[must_use]
    pub fn is_unresolved(&self) -> bool {
        matches!(self.handle, TypeHandle::Named { .. })
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn is_enum(&self) -> bool {
        self.kind == TypeKind::Enum
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn is_delegate(&self) -> bool {
        self.kind == TypeKind::Delegate
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn is_primitive(&self) -> bool {
        self.kind == TypeKind::Primitive
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn is_generic_parameter(&self) -> bool {
        self.kind == TypeKind::GenericParameter
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.flags.contains(TypeAttributes::ABSTRACT)
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.flags.contains(TypeAttributes::SEALED)
    }

    /// A static class: abstract and sealed
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.kind == TypeKind::Class && self.is_abstract() && self.is_sealed()
    }

    /// Returns true if this type is declared inside another type
    #[must_use]
    pub fn is_nested(&self) -> bool {
        matches!(self.handle, TypeHandle::Definition { .. } | TypeHandle::Instance { .. })
            && self.flags.is_nested()
    }

    /// Returns true for values copied by value: primitives, structs, enums, `Nullable<T>` and
    /// parameters constrained to non-nullable value types
    #[must_use]
    pub fn is_value_type(&self) -> bool {
        match self.kind {
            TypeKind::Primitive
            | TypeKind::Struct
            | TypeKind::Enum
            | TypeKind::Decorator(TypeModifier::Nullable) => true,
            TypeKind::GenericParameter => self
                .constraint_flags()
                .contains(GenericParamAttributes::NOT_NULLABLE_VALUE_TYPE_CONSTRAINT),
            _ => false,
        }
    }

    /// Returns true for classes, interfaces, delegates, arrays and parameters known to be
    /// reference types
    #[must_use]
    pub fn is_reference_type(&self) -> bool {
        match self.kind {
            TypeKind::Class
            | TypeKind::Interface
            | TypeKind::Delegate
            | TypeKind::Decorator(TypeModifier::Array(_)) => true,
            TypeKind::GenericParameter => {
                self.constraint_flags()
                    .contains(GenericParamAttributes::REFERENCE_TYPE_CONSTRAINT)
                    || self.type_constraints().iter().any(|constraint| {
                        constraint.kind == TypeKind::Class
                            && !constraint.is_core("System", "Object")
                            && !constraint.is_core("System", "ValueType")
                    })
            }
            _ => false,
        }
    }

    /// Returns true for ref-struct-like types, which carry `IsByRefLikeAttribute`
    #[must_use]
    pub fn is_byref_like(&self) -> bool {
        match (&self.handle, self.module()) {
            (TypeHandle::Definition { .. } | TypeHandle::Instance { .. }, Some(module)) => module
                .has_attribute(
                    Token::from_parts(TableId::TypeDef, self.row),
                    "System.Runtime.CompilerServices",
                    "IsByRefLikeAttribute",
                ),
            _ => false,
        }
    }

    /// Returns true if this is the core library type `namespace.name`
    #[must_use]
    pub fn is_core(&self, namespace: &str, name: &str) -> bool {
        self.inner()
            .is_some_and(|provider| provider.is_core_type(&self.handle, namespace, name))
    }

    /// The underlying integral type of an enum
    #[must_use]
    pub fn enum_underlying_type(&self) -> Option<TypeRc> {
        if self.kind != TypeKind::Enum {
            return None;
        }
        self.fields()
            .into_iter()
            .find(|field| !field.is_static() && field.name() == "value__")
            .and_then(|field| field.field_type())
    }

    /// The type this type is nested in. For generic parameters, the declaring type of the
    /// owning type or method.
    #[must_use]
    pub fn declaring_type(&self) -> Option<TypeRc> {
        let module = self.module()?;
        let handle = match &self.handle {
            TypeHandle::Definition { .. } | TypeHandle::Instance { .. } => {
                TypeHandle::definition(module.id(), module.enclosing_type(self.row)?)
            }
            TypeHandle::Parameter {
                owner: GenericOwner::Type { module, row },
                ..
            } => TypeHandle::definition(*module, *row),
            TypeHandle::Parameter {
                owner: GenericOwner::Method { module: id, row },
                ..
            } => TypeHandle::definition(
                *id,
                module.declaring_type(Token::from_parts(TableId::MethodDef, *row))?,
            ),
            _ => return None,
        };
        self.resolve(&handle)
    }

    /// Enclosing types, outermost first, excluding this type
    #[must_use]
    pub fn declaring_type_hierarchy(&self) -> Vec<TypeRc> {
        let mut chain = Vec::new();
        let mut current = self.declaring_type();
        while let Some(ty) = current {
            if chain.len() >= MAX_CHAIN_DEPTH {
                break;
            }
            current = ty.declaring_type();
            chain.push(ty);
        }
        chain.reverse();
        chain
    }

    /// The documentation code reference of this type (`T:N.Outer`1.Inner`)
    #[must_use]
    pub fn code_reference(&self) -> String {
        match self.inner() {
            Some(provider) => coderef::type_reference(&provider, self),
            None => format!("T:{}", self.name),
        }
    }

    /// Returns true if `handle` denotes this type
    #[must_use]
    pub fn represents(&self, handle: &Handle) -> bool {
        let Some(provider) = self.inner() else {
            return false;
        };
        match provider.canonical(handle) {
            Handle::Type(canonical) => canonical == self.handle,
            _ => false,
        }
    }

    /// TypeDef token of definitions and instances
    pub(crate) fn definition_token(&self) -> Option<Token> {
        match self.handle {
            TypeHandle::Definition { .. } | TypeHandle::Instance { .. } => {
                Some(Token::from_parts(TableId::TypeDef, self.row))
            }
            _ => None,
        }
    }

    /// Type arguments of an instance, empty for everything else
    pub(crate) fn argument_handles(&self) -> &[TypeHandle] {
        match &self.handle {
            TypeHandle::Instance { arguments, .. } => arguments,
            _ => &[],
        }
    }
}

/// Readable name of a handle, in the format of [`Type::full_name`]
pub(crate) fn display_name(provider: &Arc<ProviderInner>, handle: &TypeHandle) -> String {
    match handle {
        TypeHandle::Definition { module, row } => provider
            .module(*module)
            .map(|module| module.type_full_name(*row))
            .unwrap_or_default(),
        TypeHandle::Named { full_name, .. } => full_name.to_string(),
        TypeHandle::Instance {
            definition,
            arguments,
        } => {
            let arguments: Vec<String> = arguments
                .iter()
                .map(|argument| display_name(provider, argument))
                .collect();
            format!(
                "{}[{}]",
                display_name(provider, definition),
                arguments.join(",")
            )
        }
        TypeHandle::Parameter { .. } => provider
            .get_type(handle)
            .map(|param| param.name.clone())
            .unwrap_or_default(),
        TypeHandle::Array { element, rank } => match rank {
            0 => format!("{}[]", display_name(provider, element)),
            1 => format!("{}[*]", display_name(provider, element)),
            rank => format!(
                "{}[{}]",
                display_name(provider, element),
                ",".repeat(*rank as usize - 1)
            ),
        },
        TypeHandle::Pointer(element) => format!("{}*", display_name(provider, element)),
        TypeHandle::ByRef(element) => format!("{}&", display_name(provider, element)),
        TypeHandle::Reference { .. } => String::new(),
        TypeHandle::FunctionPointer => "method*".to_string(),
        TypeHandle::TypedReference => "System.TypedReference".to_string(),
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl Eq for Type {}

impl Hash for Type {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.handle.hash(state);
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.full_name())
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Type")
            .field("name", &self.full_name())
            .field("kind", &self.kind)
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{
        builder::{FieldBuilder, ModuleBuilder, TypeBuilder},
        signatures::TypeSignature,
    };

    fn provider_with(module: &ModuleRc) -> MetadataProvider {
        let provider = MetadataProvider::new();
        provider.register_module(module);
        provider
    }

    #[test]
    fn classification() {
        let mut module = ModuleBuilder::new("Kinds");
        TypeBuilder::class("N", "C").build(&mut module).unwrap();
        TypeBuilder::interface("N", "I").build(&mut module).unwrap();
        TypeBuilder::value_type("N", "S").build(&mut module).unwrap();
        TypeBuilder::enumeration("N", "E", TypeSignature::U1)
            .build(&mut module)
            .unwrap();
        TypeBuilder::delegate("N", "D").build(&mut module).unwrap();
        let module = module.build().unwrap();
        let provider = provider_with(&module);

        let kind = |name: &str| provider.find_type_by_full_name(name).unwrap().kind();
        assert_eq!(kind("N.C"), TypeKind::Class);
        assert_eq!(kind("N.I"), TypeKind::Interface);
        assert_eq!(kind("N.S"), TypeKind::Struct);
        assert_eq!(kind("N.E"), TypeKind::Enum);
        assert_eq!(kind("N.D"), TypeKind::Delegate);
        assert_eq!(kind("System.Int32"), TypeKind::Primitive);
        assert_eq!(kind("System.String"), TypeKind::Class);
        assert_eq!(kind("System.Decimal"), TypeKind::Struct);
        assert_eq!(kind("System.Enum"), TypeKind::Class);
        assert_eq!(kind("System.MulticastDelegate"), TypeKind::Class);

        let underlying = provider
            .find_type_by_full_name("N.E")
            .unwrap()
            .enum_underlying_type()
            .unwrap();
        assert_eq!(underlying.full_name(), "System.Byte");
        let value = provider
            .find_type_by_full_name("N.E")
            .unwrap()
            .field("value__")
            .unwrap();
        assert!(value.flags().contains(
            crate::metadata::flags::FieldAttributes::SPECIAL_NAME
                | crate::metadata::flags::FieldAttributes::RT_SPECIAL_NAME
        ));
        assert!(provider
            .find_type_by_full_name("N.S")
            .unwrap()
            .is_value_type());
    }

    #[test]
    fn names_of_nested_types() {
        let mut module = ModuleBuilder::new("Names");
        let outer = TypeBuilder::class("N", "Outer").build(&mut module).unwrap();
        let inner = TypeBuilder::class("", "Inner")
            .nested_in(outer)
            .build(&mut module)
            .unwrap();
        FieldBuilder::new("Values", TypeSignature::SzArray(Box::new(TypeSignature::Class(inner))))
            .build(&mut module, outer)
            .unwrap();
        let module = module.build().unwrap();
        let provider = provider_with(&module);

        let inner = provider.find_type_by_full_name("N.Outer+Inner").unwrap();
        assert_eq!(inner.name(), "Inner");
        assert_eq!(inner.namespace(), "N");
        assert!(inner.is_nested());
        assert_eq!(inner.declaring_type().unwrap().full_name(), "N.Outer");
        assert_eq!(inner.declaring_type_hierarchy().len(), 1);

        let outer = provider.find_type_by_full_name("N.Outer").unwrap();
        let values = outer.field("Values").unwrap().field_type().unwrap();
        assert_eq!(values.name(), "Inner[]");
        assert_eq!(values.full_name(), "N.Outer+Inner[]");
        assert_eq!(values.kind(), TypeKind::Decorator(TypeModifier::Array(0)));
        assert_eq!(values.base_type().unwrap().full_name(), "System.Array");
    }

    #[test]
    fn unresolved_references() {
        let mut module = ModuleBuilder::new("Dangling");
        let missing = module.type_ref("Missing.Assembly", "Far", "Away");
        TypeBuilder::class("N", "C")
            .extends(TypeSignature::Class(missing))
            .build(&mut module)
            .unwrap();
        let module = module.build().unwrap();
        let provider = provider_with(&module);

        let class = provider.find_type_by_full_name("N.C").unwrap();
        let base = class.base_type().unwrap();
        assert!(base.is_unresolved());
        assert_eq!(base.name(), "Away");
        assert_eq!(base.namespace(), "Far");
        assert!(base.module().is_none());
        assert!(base.base_type().is_none());
    }
}
