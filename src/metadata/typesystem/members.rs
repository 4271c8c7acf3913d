//! Members of types: constructors, methods, operators, properties, fields, events and
//! parameters, and the [`Member`] union over all metadata objects.
//!
//! Members of a constructed generic type are distinct objects from the members of its definition:
//! their handles carry the instance as declaring type, and their signature types are substituted
//! with the type arguments.

use std::{
    fmt,
    sync::{Arc, Weak},
};

use crate::{
    metadata::{
        binding::Scope,
        coderef,
        comparer::method_parameters,
        constant::ConstantValue,
        flags::{
            EventAttributes, FieldAttributes, MethodAttributes, MethodSemanticsAttributes,
            ParamAttributes, PropertyAttributes, Visibility,
        },
        handle::{Handle, MemberHandle, MethodHandle, ParameterHandle, TypeHandle},
        module::{Module, ModuleRc},
        provider::ProviderInner,
        signatures::{
            parse_field_signature, parse_method_signature, parse_property_signature,
            SignatureParameter, TypeSignature,
        },
        tables::{row, TableId},
        token::Token,
        typesystem::{logged, Type, TypeKind, TypeRc},
    },
    Error, Result,
};

/// A reference counted method, constructor or operator
pub type MethodRc = Arc<Method>;
/// A reference counted field
pub type FieldRc = Arc<Field>;
/// A reference counted property
pub type PropertyRc = Arc<Property>;
/// A reference counted event
pub type EventRc = Arc<Event>;
/// A reference counted parameter
pub type ParameterRc = Arc<Parameter>;

/// Any metadata object.
#[derive(Clone)]
#[allow(missing_docs)]
pub enum Member {
    Type(TypeRc),
    TypeParameter(TypeRc),
    Constructor(MethodRc),
    Method(MethodRc),
    Operator(MethodRc),
    Property(PropertyRc),
    Field(FieldRc),
    Event(EventRc),
    Parameter(ParameterRc),
}

impl Member {
    /// Builds the object of a canonical handle
    pub(crate) fn materialize(provider: &Arc<ProviderInner>, handle: &Handle) -> Result<Member> {
        Ok(match handle {
            Handle::Type(handle) => {
                let ty = Arc::new(Type::load(provider, handle)?);
                if ty.kind() == TypeKind::GenericParameter {
                    Member::TypeParameter(ty)
                } else {
                    Member::Type(ty)
                }
            }
            Handle::Method(handle) => {
                let method = Arc::new(Method::load(provider, handle)?);
                match method.kind {
                    MethodKind::Constructor => Member::Constructor(method),
                    MethodKind::Method => Member::Method(method),
                    MethodKind::Operator => Member::Operator(method),
                }
            }
            Handle::Field(handle) => Member::Field(Arc::new(Field::load(provider, handle)?)),
            Handle::Property(handle) => {
                Member::Property(Arc::new(Property::load(provider, handle)?))
            }
            Handle::Event(handle) => Member::Event(Arc::new(Event::load(provider, handle)?)),
            Handle::Parameter(handle) => {
                Member::Parameter(Arc::new(Parameter::load(provider, handle)?))
            }
        })
    }

    /// Simple name
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Member::Type(ty) | Member::TypeParameter(ty) => ty.name(),
            Member::Constructor(method) | Member::Method(method) | Member::Operator(method) => {
                method.name()
            }
            Member::Property(property) => property.name(),
            Member::Field(field) => field.name(),
            Member::Event(event) => event.name(),
            Member::Parameter(parameter) => parameter.name(),
        }
    }

    /// Name of the variant, for diagnostics
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Member::Type(_) => "type",
            Member::TypeParameter(_) => "type parameter",
            Member::Constructor(_) => "constructor",
            Member::Method(_) => "method",
            Member::Operator(_) => "operator",
            Member::Property(_) => "property",
            Member::Field(_) => "field",
            Member::Event(_) => "event",
            Member::Parameter(_) => "parameter",
        }
    }

    /// The canonical handle of the object
    #[must_use]
    pub fn handle(&self) -> Handle {
        match self {
            Member::Type(ty) | Member::TypeParameter(ty) => Handle::Type(ty.handle().clone()),
            Member::Constructor(method) | Member::Method(method) | Member::Operator(method) => {
                Handle::Method(method.handle.clone())
            }
            Member::Property(property) => Handle::Property(property.handle.clone()),
            Member::Field(field) => Handle::Field(field.handle.clone()),
            Member::Event(event) => Handle::Event(event.handle.clone()),
            Member::Parameter(parameter) => Handle::Parameter(parameter.handle.clone()),
        }
    }

    fn inner(&self) -> Option<Arc<ProviderInner>> {
        match self {
            Member::Type(ty) | Member::TypeParameter(ty) => ty.inner(),
            Member::Constructor(method) | Member::Method(method) | Member::Operator(method) => {
                method.provider.upgrade()
            }
            Member::Property(property) => property.provider.upgrade(),
            Member::Field(field) => field.provider.upgrade(),
            Member::Event(event) => event.provider.upgrade(),
            Member::Parameter(parameter) => parameter.provider.upgrade(),
        }
    }

    /// The type declaring this member; for types, the enclosing type
    #[must_use]
    pub fn declaring_type(&self) -> Option<TypeRc> {
        match self {
            Member::Type(ty) | Member::TypeParameter(ty) => ty.declaring_type(),
            Member::Constructor(method) | Member::Method(method) | Member::Operator(method) => {
                method.declaring_type()
            }
            Member::Property(property) => property.declaring_type(),
            Member::Field(field) => field.declaring_type(),
            Member::Event(event) => event.declaring_type(),
            Member::Parameter(parameter) => parameter.method()?.declaring_type(),
        }
    }

    /// The documentation code reference. Type parameters and parameters have none of their own
    /// and report the reference of their declaring member.
    #[must_use]
    pub fn code_reference(&self) -> String {
        match self {
            Member::Type(ty) => ty.code_reference(),
            Member::TypeParameter(ty) => match ty.declaring_method() {
                Some(method) => method.code_reference(),
                None => ty
                    .declaring_type()
                    .map(|owner| owner.code_reference())
                    .unwrap_or_default(),
            },
            Member::Constructor(method) | Member::Method(method) | Member::Operator(method) => {
                method.code_reference()
            }
            Member::Property(property) => property.code_reference(),
            Member::Field(field) => field.code_reference(),
            Member::Event(event) => event.code_reference(),
            Member::Parameter(parameter) => parameter
                .method()
                .map(|method| method.code_reference())
                .unwrap_or_default(),
        }
    }

    /// Returns true if `handle` denotes this object
    #[must_use]
    pub fn represents(&self, handle: &Handle) -> bool {
        self.inner()
            .is_some_and(|provider| provider.canonical(handle) == self.handle())
    }

    /// Declared accessibility; parameters report the visibility of their method
    #[must_use]
    pub fn visibility(&self) -> Visibility {
        match self {
            Member::Type(ty) | Member::TypeParameter(ty) => ty.visibility(),
            Member::Constructor(method) | Member::Method(method) | Member::Operator(method) => {
                method.visibility()
            }
            Member::Property(property) => property.visibility(),
            Member::Field(field) => field.visibility(),
            Member::Event(event) => event.visibility(),
            Member::Parameter(parameter) => parameter
                .method()
                .map_or(Visibility::Public, |method| method.visibility()),
        }
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn as_type(&self) -> Option<&TypeRc> {
        match self {
            Member::Type(ty) | Member::TypeParameter(ty) => Some(ty),
            _ => None,
        }
    }

    /// The method of constructors, methods and operators
    #[must_use]
    pub fn as_method(&self) -> Option<&MethodRc> {
        match self {
            Member::Constructor(method) | Member::Method(method) | Member::Operator(method) => {
                Some(method)
            }
            _ => None,
        }
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn as_property(&self) -> Option<&PropertyRc> {
        match self {
            Member::Property(property) => Some(property),
            _ => None,
        }
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn as_field(&self) -> Option<&FieldRc> {
        match self {
            Member::Field(field) => Some(field),
            _ => None,
        }
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn as_event(&self) -> Option<&EventRc> {
        match self {
            Member::Event(event) => Some(event),
            _ => None,
        }
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn as_parameter(&self) -> Option<&ParameterRc> {
        match self {
            Member::Parameter(parameter) => Some(parameter),
            _ => None,
        }
    }
}

impl PartialEq for Member {
    fn eq(&self, other: &Self) -> bool {
        self.handle() == other.handle()
    }
}

impl Eq for Member {}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind_name(), self.code_reference())
    }
}

impl From<TypeRc> for Member {
    fn from(ty: TypeRc) -> Self {
        if ty.kind() == TypeKind::GenericParameter {
            Member::TypeParameter(ty)
        } else {
            Member::Type(ty)
        }
    }
}

impl From<MethodRc> for Member {
    fn from(method: MethodRc) -> Self {
        match method.kind {
            MethodKind::Constructor => Member::Constructor(method),
            MethodKind::Method => Member::Method(method),
            MethodKind::Operator => Member::Operator(method),
        }
    }
}

impl From<PropertyRc> for Member {
    fn from(property: PropertyRc) -> Self {
        Member::Property(property)
    }
}

impl From<FieldRc> for Member {
    fn from(field: FieldRc) -> Self {
        Member::Field(field)
    }
}

impl From<EventRc> for Member {
    fn from(event: EventRc) -> Self {
        Member::Event(event)
    }
}

impl ProviderInner {
    pub(crate) fn get_method(self: &Arc<Self>, handle: &MethodHandle) -> Result<MethodRc> {
        match self.member(&Handle::Method(handle.clone()))? {
            Member::Constructor(method) | Member::Method(method) | Member::Operator(method) => {
                Ok(method)
            }
            other => Err(malformed_error!("Method handle materialized as {}", other.kind_name())),
        }
    }

    pub(crate) fn get_field(self: &Arc<Self>, handle: &MemberHandle) -> Result<FieldRc> {
        match self.member(&Handle::Field(handle.clone()))? {
            Member::Field(field) => Ok(field),
            other => Err(malformed_error!("Field handle materialized as {}", other.kind_name())),
        }
    }

    pub(crate) fn get_property(self: &Arc<Self>, handle: &MemberHandle) -> Result<PropertyRc> {
        match self.member(&Handle::Property(handle.clone()))? {
            Member::Property(property) => Ok(property),
            other => Err(malformed_error!(
                "Property handle materialized as {}",
                other.kind_name()
            )),
        }
    }

    pub(crate) fn get_event(self: &Arc<Self>, handle: &MemberHandle) -> Result<EventRc> {
        match self.member(&Handle::Event(handle.clone()))? {
            Member::Event(event) => Ok(event),
            other => Err(malformed_error!("Event handle materialized as {}", other.kind_name())),
        }
    }

    pub(crate) fn get_parameter(self: &Arc<Self>, handle: &ParameterHandle) -> Result<ParameterRc> {
        match self.member(&Handle::Parameter(handle.clone()))? {
            Member::Parameter(parameter) => Ok(parameter),
            other => Err(malformed_error!(
                "Parameter handle materialized as {}",
                other.kind_name()
            )),
        }
    }

    /// Converts a member signature type and closes it over the declaring instance
    fn member_type(
        &self,
        module: &ModuleRc,
        scope: Scope,
        signature: &TypeSignature,
        declaring: &TypeHandle,
        method_arguments: &[TypeHandle],
    ) -> Result<TypeHandle> {
        let converted = self.convert(module, scope, signature)?;
        Ok(match declaring {
            TypeHandle::Instance { arguments, .. } => {
                self.canonical_type(&converted.substitute(arguments, method_arguments))
            }
            _ if !method_arguments.is_empty() => {
                self.canonical_type(&converted.substitute(&[], method_arguments))
            }
            _ => converted,
        })
    }
}

/// Checks that `declaring` is the type definition `row` or an instance of it
fn check_declaring(
    module: &ModuleRc,
    declaring: &TypeHandle,
    row: u32,
    member: Token,
) -> Result<()> {
    let definition = match declaring {
        TypeHandle::Instance { definition, .. } => definition.as_ref(),
        other => other,
    };
    if *definition == TypeHandle::definition(module.id(), row) {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!(
            "{member} is not declared by {declaring:?}"
        )))
    }
}

/// The role of a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodKind {
    /// `.ctor` or `.cctor`
    Constructor,
    /// An ordinary method, accessors included
    Method,
    /// A special-name `op_*` method
    Operator,
}

/// A method, constructor or operator.
pub struct Method {
    handle: MethodHandle,
    kind: MethodKind,
    name: String,
    flags: MethodAttributes,
    has_this: bool,
    vararg: bool,
    return_type: TypeHandle,
    parameter_types: Vec<TypeHandle>,
    generic_count: usize,
    declaring_row: u32,
    module: Weak<Module>,
    provider: Weak<ProviderInner>,
}

impl Method {
    fn load(provider: &Arc<ProviderInner>, handle: &MethodHandle) -> Result<Method> {
        let module = provider.module(handle.module)?;
        let token = handle.token();
        let def = row(&module.tables().method_def, handle.row).ok_or(Error::TokenNotFound(token))?;
        let declaring_row = module
            .declaring_type(token)
            .ok_or(Error::TokenNotFound(token))?;
        check_declaring(&module, &handle.declaring, declaring_row, token)?;

        let signature = parse_method_signature(&def.signature)?;
        let generic_count = module.generic_params(token).len();
        if !handle.arguments.is_empty() && handle.arguments.len() != generic_count {
            return Err(Error::InvalidArgument(format!(
                "{} expects {} type arguments, got {}",
                def.name,
                generic_count,
                handle.arguments.len()
            )));
        }

        let scope = Scope::of_method(&module, Some(declaring_row), handle.row);
        let convert = |signature: &SignatureParameter| {
            provider.member_type(
                &module,
                scope,
                &signature.to_type(),
                &handle.declaring,
                &handle.arguments,
            )
        };
        let return_type = convert(&signature.return_type)?;
        let parameter_types = signature
            .params
            .iter()
            .map(convert)
            .collect::<Result<Vec<_>>>()?;

        let kind = if def.name == ".ctor" || def.name == ".cctor" {
            MethodKind::Constructor
        } else if def.flags.contains(MethodAttributes::SPECIAL_NAME) && def.name.starts_with("op_")
        {
            MethodKind::Operator
        } else {
            MethodKind::Method
        };

        Ok(Method {
            handle: handle.clone(),
            kind,
            name: def.name.clone(),
            flags: def.flags,
            has_this: signature.has_this,
            vararg: signature.vararg,
            return_type,
            parameter_types,
            generic_count,
            declaring_row,
            module: Arc::downgrade(&module),
            provider: Arc::downgrade(provider),
        })
    }

    pub(crate) fn inner(&self) -> Option<Arc<ProviderInner>> {
        self.provider.upgrade()
    }

    pub(crate) fn module(&self) -> Option<ModuleRc> {
        self.module.upgrade()
    }

    fn resolve(&self, handle: &TypeHandle) -> Option<TypeRc> {
        logged(self.inner()?.get_type(handle), &self.name)
    }

    /// The canonical handle
    #[must_use]
    pub fn handle(&self) -> &MethodHandle {
        &self.handle
    }

    /// Constructor, method or operator
    #[must_use]
    pub fn kind(&self) -> MethodKind {
        self.kind
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn flags(&self) -> MethodAttributes {
        self.flags
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn visibility(&self) -> Visibility {
        self.flags.visibility()
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.flags.contains(MethodAttributes::STATIC) || !self.has_this
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn is_virtual(&self) -> bool {
        self.flags.contains(MethodAttributes::VIRTUAL)
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.flags.contains(MethodAttributes::ABSTRACT)
    }

    /// A virtual method that can not be overridden further
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.flags.contains(MethodAttributes::FINAL)
    }

    /// The special-name bit exactly as stored in metadata
    #[must_use]
    pub fn is_special_name(&self) -> bool {
        self.flags.contains(MethodAttributes::SPECIAL_NAME)
    }

    /// Takes a variable argument list (`__arglist`)
    #[must_use]
    pub fn is_vararg(&self) -> bool {
        self.vararg
    }

    /// The `MethodDef` token
    #[must_use]
    pub fn token(&self) -> Token {
        self.handle.token()
    }

    /// Returns true for an open generic method definition
    #[must_use]
    pub fn is_generic_method_definition(&self) -> bool {
        self.generic_count > 0 && self.handle.arguments.is_empty()
    }

    /// Returns true for a method constructed over type arguments
    #[must_use]
    pub fn is_constructed_generic_method(&self) -> bool {
        !self.handle.arguments.is_empty()
    }

    /// The method's own generic parameters
    #[must_use]
    pub fn generic_parameters(&self) -> Vec<TypeRc> {
        let Some(module) = self.module() else {
            return Vec::new();
        };
        method_parameters(&module, self.handle.row, self.generic_count)
            .iter()
            .filter_map(|parameter| self.resolve(parameter))
            .collect()
    }

    /// Type arguments of a constructed generic method
    #[must_use]
    pub fn generic_arguments(&self) -> Vec<TypeRc> {
        self.handle
            .arguments
            .iter()
            .filter_map(|argument| self.resolve(argument))
            .collect()
    }

    /// Constructs this generic method definition over `arguments`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] if this is not a generic method definition or the
    /// argument count does not match.
    pub fn make_generic_method(&self, arguments: &[TypeRc]) -> Result<MethodRc> {
        if !self.is_generic_method_definition() {
            return Err(Error::InvalidArgument(format!(
                "{} is not a generic method definition",
                self.name
            )));
        }
        if arguments.len() != self.generic_count {
            return Err(Error::InvalidArgument(format!(
                "{} expects {} type arguments, got {}",
                self.name,
                self.generic_count,
                arguments.len()
            )));
        }
        let provider = self.inner().ok_or(Error::Unloaded)?;
        provider.get_method(&MethodHandle {
            arguments: arguments
                .iter()
                .map(|argument| argument.handle().clone())
                .collect(),
            ..self.handle.clone()
        })
    }

    /// The generic method definition of a constructed method; a definition returns itself.
    #[must_use]
    pub fn generic_method_definition(self: &Arc<Self>) -> Option<MethodRc> {
        if self.handle.arguments.is_empty() {
            return (self.generic_count > 0).then(|| self.clone());
        }
        let handle = MethodHandle {
            arguments: Vec::new(),
            ..self.handle.clone()
        };
        logged(self.inner()?.get_method(&handle), &self.name)
    }

    /// The same method on the generic type definition, without method type arguments
    #[must_use]
    pub fn member_definition(self: &Arc<Self>) -> MethodRc {
        let handle = MethodHandle {
            declaring: TypeHandle::definition(self.handle.module, self.declaring_row),
            module: self.handle.module,
            row: self.handle.row,
            arguments: Vec::new(),
        };
        if handle == self.handle {
            return self.clone();
        }
        self.inner()
            .and_then(|provider| logged(provider.get_method(&handle), &self.name))
            .unwrap_or_else(|| self.clone())
    }

    pub(crate) fn return_type_handle(&self) -> &TypeHandle {
        &self.return_type
    }

    pub(crate) fn parameter_type_handles(&self) -> &[TypeHandle] {
        &self.parameter_types
    }

    pub(crate) fn generic_count(&self) -> usize {
        self.generic_count
    }

    pub(crate) fn declaring_row(&self) -> u32 {
        self.declaring_row
    }

    /// Return type; `System.Void` for methods without one. `None` for function pointers.
    #[must_use]
    pub fn return_type(&self) -> Option<TypeRc> {
        self.resolve(&self.return_type)
    }

    /// Types of the formal parameters, in order
    #[must_use]
    pub fn parameter_types(&self) -> Vec<TypeRc> {
        self.parameter_types
            .iter()
            .filter_map(|parameter| self.resolve(parameter))
            .collect()
    }

    /// The formal parameters, in order
    #[must_use]
    pub fn parameters(&self) -> Vec<ParameterRc> {
        let Some(provider) = self.inner() else {
            return Vec::new();
        };
        (0..self.parameter_types.len())
            .filter_map(|position| {
                let handle = ParameterHandle {
                    method: self.handle.clone(),
                    position: u32::try_from(position).ok()?,
                };
                logged(provider.get_parameter(&handle), &self.name)
            })
            .collect()
    }

    /// The declaring type; an instance for methods of constructed types
    #[must_use]
    pub fn declaring_type(&self) -> Option<TypeRc> {
        self.resolve(&self.handle.declaring)
    }

    /// The property or event this method is an accessor of
    #[must_use]
    pub fn associated_member(&self) -> Option<Member> {
        let (_, association) = self.module()?.semantics(self.handle.row)?;
        let provider = self.inner()?;
        let handle = MemberHandle {
            declaring: self.handle.declaring.clone(),
            module: self.handle.module,
            row: association.row(),
        };
        if association.is_table(TableId::Property) {
            logged(provider.get_property(&handle), &self.name).map(Member::Property)
        } else if association.is_table(TableId::Event) {
            logged(provider.get_event(&handle), &self.name).map(Member::Event)
        } else {
            None
        }
    }

    /// Returns true for property and event accessors
    #[must_use]
    pub fn is_accessor(&self) -> bool {
        self.module()
            .is_some_and(|module| module.semantics(self.handle.row).is_some())
    }

    /// The documentation code reference (`M:N.C.Run(System.Int32)`)
    #[must_use]
    pub fn code_reference(&self) -> String {
        coderef::method_reference(self)
    }
}

impl PartialEq for Method {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl Eq for Method {}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

/// How a parameter is passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    /// By value
    None,
    /// `in`: a read-only reference
    In,
    /// `ref`
    Ref,
    /// `out`
    Out,
}

/// A formal parameter of a method.
pub struct Parameter {
    handle: ParameterHandle,
    name: String,
    flags: ParamAttributes,
    param_row: Option<u32>,
    parameter_type: TypeHandle,
    module: Weak<Module>,
    provider: Weak<ProviderInner>,
}

impl Parameter {
    fn load(provider: &Arc<ProviderInner>, handle: &ParameterHandle) -> Result<Parameter> {
        let method = provider.get_method(&handle.method)?;
        let module = provider.module(handle.method.module)?;
        let parameter_type = method
            .parameter_types
            .get(handle.position as usize)
            .cloned()
            .ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "{} has no parameter at position {}",
                    method.name, handle.position
                ))
            })?;

        let tables = module.tables();
        let param_row = tables.params_of(handle.method.row).into_iter().find(|param| {
            row(&tables.param, *param)
                .is_some_and(|param| u32::from(param.sequence) == handle.position + 1)
        });
        let (name, flags) = param_row
            .and_then(|param| row(&tables.param, param))
            .map(|param| (param.name.clone(), param.flags))
            .unwrap_or_default();

        Ok(Parameter {
            handle: handle.clone(),
            name,
            flags,
            param_row,
            parameter_type,
            module: Arc::downgrade(&module),
            provider: Arc::downgrade(provider),
        })
    }

    fn token(&self) -> Option<Token> {
        self.param_row
            .map(|param| Token::from_parts(TableId::Param, param))
    }

    /// The canonical handle
    #[must_use]
    pub fn handle(&self) -> &ParameterHandle {
        &self.handle
    }

    /// Declared name; empty if the module carries no `Param` row for the parameter
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Zero-based position in the parameter list
    #[must_use]
    pub fn position(&self) -> u32 {
        self.handle.position
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn flags(&self) -> ParamAttributes {
        self.flags
    }

    /// The declared type; by-ref parameters report the `ByRef` decorator
    #[must_use]
    pub fn parameter_type(&self) -> Option<TypeRc> {
        logged(self.provider.upgrade()?.get_type(&self.parameter_type), &self.name)
    }

    /// The declaring method
    #[must_use]
    pub fn method(&self) -> Option<MethodRc> {
        logged(self.provider.upgrade()?.get_method(&self.handle.method), &self.name)
    }

    /// The default value of an optional parameter
    #[must_use]
    pub fn default(&self) -> Option<ConstantValue> {
        self.module.upgrade()?.constant(self.token()?).cloned()
    }

    fn has_attribute(&self, namespace: &str, name: &str) -> bool {
        match (self.module.upgrade(), self.token()) {
            (Some(module), Some(token)) => module.has_attribute(token, namespace, name),
            _ => false,
        }
    }

    /// How the argument is passed
    #[must_use]
    pub fn ref_kind(&self) -> RefKind {
        if !matches!(self.parameter_type, TypeHandle::ByRef(_)) {
            return RefKind::None;
        }
        if self.flags.contains(ParamAttributes::OUT) && !self.flags.contains(ParamAttributes::IN) {
            RefKind::Out
        } else if self.flags.contains(ParamAttributes::IN)
            || self.has_attribute("System.Runtime.CompilerServices", "IsReadOnlyAttribute")
        {
            RefKind::In
        } else {
            RefKind::Ref
        }
    }

    /// Returns true if callers may omit the argument
    #[must_use]
    pub fn is_optional(&self) -> bool {
        self.flags
            .intersects(ParamAttributes::OPTIONAL | ParamAttributes::HAS_DEFAULT)
    }

    /// A `params` array
    #[must_use]
    pub fn is_params_array(&self) -> bool {
        self.has_attribute("System", "ParamArrayAttribute")
    }

    /// Returns true if the parameter type is an array
    #[must_use]
    pub fn is_array(&self) -> bool {
        matches!(self.parameter_type, TypeHandle::Array { .. })
    }
}

impl PartialEq for Parameter {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl Eq for Parameter {}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("name", &self.name)
            .field("position", &self.handle.position)
            .finish_non_exhaustive()
    }
}

/// A field.
pub struct Field {
    handle: MemberHandle,
    name: String,
    flags: FieldAttributes,
    field_type: TypeHandle,
    module: Weak<Module>,
    provider: Weak<ProviderInner>,
}

impl Field {
    fn load(provider: &Arc<ProviderInner>, handle: &MemberHandle) -> Result<Field> {
        let module = provider.module(handle.module)?;
        let token = Token::from_parts(TableId::Field, handle.row);
        let def = row(&module.tables().field, handle.row).ok_or(Error::TokenNotFound(token))?;
        let declaring_row = module
            .declaring_type(token)
            .ok_or(Error::TokenNotFound(token))?;
        check_declaring(&module, &handle.declaring, declaring_row, token)?;

        let signature = parse_field_signature(&def.signature)?;
        let field_type = provider.member_type(
            &module,
            Scope::of_type(declaring_row),
            &signature.base,
            &handle.declaring,
            &[],
        )?;

        Ok(Field {
            handle: handle.clone(),
            name: def.name.clone(),
            flags: def.flags,
            field_type,
            module: Arc::downgrade(&module),
            provider: Arc::downgrade(provider),
        })
    }

    pub(crate) fn inner(&self) -> Option<Arc<ProviderInner>> {
        self.provider.upgrade()
    }

    pub(crate) fn module(&self) -> Option<ModuleRc> {
        self.module.upgrade()
    }

    /// The canonical handle
    #[must_use]
    pub fn handle(&self) -> &MemberHandle {
        &self.handle
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn flags(&self) -> FieldAttributes {
        self.flags
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn visibility(&self) -> Visibility {
        self.flags.visibility()
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.flags.contains(FieldAttributes::STATIC)
    }

    /// A compile time constant (`const`)
    #[must_use]
    pub fn is_literal(&self) -> bool {
        self.flags.contains(FieldAttributes::LITERAL)
    }

    /// Assignable only during construction (`readonly`)
    #[must_use]
    pub fn is_init_only(&self) -> bool {
        self.flags.contains(FieldAttributes::INIT_ONLY)
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn field_type(&self) -> Option<TypeRc> {
        logged(self.provider.upgrade()?.get_type(&self.field_type), &self.name)
    }

    /// The value of a literal field
    #[must_use]
    pub fn constant(&self) -> Option<ConstantValue> {
        self.module
            .upgrade()?
            .constant(Token::from_parts(TableId::Field, self.handle.row))
            .cloned()
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn declaring_type(&self) -> Option<TypeRc> {
        logged(self.provider.upgrade()?.get_type(&self.handle.declaring), &self.name)
    }

    /// The documentation code reference (`F:N.C.Count`)
    #[must_use]
    pub fn code_reference(&self) -> String {
        coderef::field_reference(self)
    }
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl Eq for Field {}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

/// Looks up the accessor of `association` with `role`
fn accessor(
    provider: &Weak<ProviderInner>,
    module: &Weak<Module>,
    declaring: &MemberHandle,
    association: Token,
    role: MethodSemanticsAttributes,
) -> Option<MethodRc> {
    let module = module.upgrade()?;
    let (_, method_row) = module
        .accessors(association)
        .iter()
        .find(|(semantics, _)| semantics.contains(role))?;
    let handle = MethodHandle {
        declaring: declaring.declaring.clone(),
        module: declaring.module,
        row: *method_row,
        arguments: Vec::new(),
    };
    logged(provider.upgrade()?.get_method(&handle), "accessor")
}

/// A property.
pub struct Property {
    handle: MemberHandle,
    name: String,
    flags: PropertyAttributes,
    has_this: bool,
    property_type: TypeHandle,
    index_types: Vec<TypeHandle>,
    module: Weak<Module>,
    provider: Weak<ProviderInner>,
}

impl Property {
    fn load(provider: &Arc<ProviderInner>, handle: &MemberHandle) -> Result<Property> {
        let module = provider.module(handle.module)?;
        let token = Token::from_parts(TableId::Property, handle.row);
        let def = row(&module.tables().property, handle.row).ok_or(Error::TokenNotFound(token))?;
        let declaring_row = module
            .declaring_type(token)
            .ok_or(Error::TokenNotFound(token))?;
        check_declaring(&module, &handle.declaring, declaring_row, token)?;

        let signature = parse_property_signature(&def.signature)?;
        let scope = Scope::of_type(declaring_row);
        let property_type =
            provider.member_type(&module, scope, &signature.base, &handle.declaring, &[])?;
        let index_types = signature
            .params
            .iter()
            .map(|param| {
                provider.member_type(&module, scope, &param.to_type(), &handle.declaring, &[])
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Property {
            handle: handle.clone(),
            name: def.name.clone(),
            flags: def.flags,
            has_this: signature.has_this,
            property_type,
            index_types,
            module: Arc::downgrade(&module),
            provider: Arc::downgrade(provider),
        })
    }

    fn token(&self) -> Token {
        Token::from_parts(TableId::Property, self.handle.row)
    }

    pub(crate) fn inner(&self) -> Option<Arc<ProviderInner>> {
        self.provider.upgrade()
    }

    pub(crate) fn module(&self) -> Option<ModuleRc> {
        self.module.upgrade()
    }

    /// The canonical handle
    #[must_use]
    pub fn handle(&self) -> &MemberHandle {
        &self.handle
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn flags(&self) -> PropertyAttributes {
        self.flags
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn is_static(&self) -> bool {
        !self.has_this
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn property_type(&self) -> Option<TypeRc> {
        logged(self.provider.upgrade()?.get_type(&self.property_type), &self.name)
    }

    /// Parameter types of an indexer, empty for plain properties
    #[must_use]
    pub fn index_parameter_types(&self) -> Vec<TypeRc> {
        let Some(provider) = self.provider.upgrade() else {
            return Vec::new();
        };
        self.index_types
            .iter()
            .filter_map(|index| logged(provider.get_type(index), &self.name))
            .collect()
    }

    pub(crate) fn index_type_handles(&self) -> &[TypeHandle] {
        &self.index_types
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn getter(&self) -> Option<MethodRc> {
        accessor(
            &self.provider,
            &self.module,
            &self.handle,
            self.token(),
            MethodSemanticsAttributes::GETTER,
        )
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn setter(&self) -> Option<MethodRc> {
        accessor(
            &self.provider,
            &self.module,
            &self.handle,
            self.token(),
            MethodSemanticsAttributes::SETTER,
        )
    }

    /// Getter, then setter, whichever exist
    pub(crate) fn accessors(&self) -> Vec<MethodRc> {
        self.getter().into_iter().chain(self.setter()).collect()
    }

    /// The most visible accessor's visibility
    #[must_use]
    pub fn visibility(&self) -> Visibility {
        self.accessors()
            .iter()
            .map(|method| method.visibility())
            .max()
            .unwrap_or(Visibility::Private)
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn is_virtual(&self) -> bool {
        self.accessors().iter().any(|method| method.is_virtual())
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.accessors().iter().any(|method| method.is_abstract())
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn declaring_type(&self) -> Option<TypeRc> {
        logged(self.provider.upgrade()?.get_type(&self.handle.declaring), &self.name)
    }

    /// The documentation code reference (`P:N.C.Item(System.Int32)`)
    #[must_use]
    pub fn code_reference(&self) -> String {
        coderef::property_reference(self)
    }
}

impl PartialEq for Property {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl Eq for Property {}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

/// An event.
pub struct Event {
    handle: MemberHandle,
    name: String,
    flags: EventAttributes,
    event_type: TypeHandle,
    module: Weak<Module>,
    provider: Weak<ProviderInner>,
}

impl Event {
    fn load(provider: &Arc<ProviderInner>, handle: &MemberHandle) -> Result<Event> {
        let module = provider.module(handle.module)?;
        let token = Token::from_parts(TableId::Event, handle.row);
        let def = row(&module.tables().event, handle.row).ok_or(Error::TokenNotFound(token))?;
        let declaring_row = module
            .declaring_type(token)
            .ok_or(Error::TokenNotFound(token))?;
        check_declaring(&module, &handle.declaring, declaring_row, token)?;

        let event_type =
            provider.type_token(&module, Scope::of_type(declaring_row), def.event_type)?;
        let event_type = match &handle.declaring {
            TypeHandle::Instance { arguments, .. } => {
                provider.canonical_type(&event_type.substitute(arguments, &[]))
            }
            _ => event_type,
        };

        Ok(Event {
            handle: handle.clone(),
            name: def.name.clone(),
            flags: def.flags,
            event_type,
            module: Arc::downgrade(&module),
            provider: Arc::downgrade(provider),
        })
    }

    fn token(&self) -> Token {
        Token::from_parts(TableId::Event, self.handle.row)
    }

    pub(crate) fn inner(&self) -> Option<Arc<ProviderInner>> {
        self.provider.upgrade()
    }

    pub(crate) fn module(&self) -> Option<ModuleRc> {
        self.module.upgrade()
    }

    /// The canonical handle
    #[must_use]
    pub fn handle(&self) -> &MemberHandle {
        &self.handle
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn flags(&self) -> EventAttributes {
        self.flags
    }

    /// The delegate type of the event
    #[must_use]
    pub fn event_type(&self) -> Option<TypeRc> {
        logged(self.provider.upgrade()?.get_type(&self.event_type), &self.name)
    }

    fn accessor(&self, role: MethodSemanticsAttributes) -> Option<MethodRc> {
        accessor(&self.provider, &self.module, &self.handle, self.token(), role)
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn adder(&self) -> Option<MethodRc> {
        self.accessor(MethodSemanticsAttributes::ADD_ON)
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn remover(&self) -> Option<MethodRc> {
        self.accessor(MethodSemanticsAttributes::REMOVE_ON)
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn raiser(&self) -> Option<MethodRc> {
        self.accessor(MethodSemanticsAttributes::FIRE)
    }

    pub(crate) fn accessors(&self) -> Vec<MethodRc> {
        self.adder()
            .into_iter()
            .chain(self.remover())
            .chain(self.raiser())
            .collect()
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.adder().is_some_and(|adder| adder.is_static())
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn visibility(&self) -> Visibility {
        self.accessors()
            .iter()
            .map(|method| method.visibility())
            .max()
            .unwrap_or(Visibility::Private)
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn declaring_type(&self) -> Option<TypeRc> {
        logged(self.provider.upgrade()?.get_type(&self.handle.declaring), &self.name)
    }

    /// The documentation code reference (`E:N.C.Changed`)
    #[must_use]
    pub fn code_reference(&self) -> String {
        coderef::event_reference(self)
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl Eq for Event {}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.name)
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

impl Type {
    fn method_rows(&self) -> Vec<u32> {
        match (self.definition_token(), self.module()) {
            (Some(_), Some(module)) => module.tables().methods_of(self.row),
            _ => Vec::new(),
        }
    }

    /// Every method row of this type, accessors and constructors included, in declaration order
    #[must_use]
    pub fn all_methods(&self) -> Vec<MethodRc> {
        let (Some(provider), Some(module)) = (self.inner(), self.module()) else {
            return Vec::new();
        };
        self.method_rows()
            .into_iter()
            .filter_map(|row| {
                let handle = MethodHandle {
                    declaring: self.handle.clone(),
                    module: module.id(),
                    row,
                    arguments: Vec::new(),
                };
                logged(provider.get_method(&handle), &self.name)
            })
            .collect()
    }

    /// Instance and static constructors
    #[must_use]
    pub fn constructors(&self) -> Vec<MethodRc> {
        self.all_methods()
            .into_iter()
            .filter(|method| method.kind == MethodKind::Constructor)
            .collect()
    }

    /// Ordinary methods, excluding property and event accessors
    #[must_use]
    pub fn methods(&self) -> Vec<MethodRc> {
        self.all_methods()
            .into_iter()
            .filter(|method| method.kind == MethodKind::Method && !method.is_accessor())
            .collect()
    }

    /// User-defined operators (special-name `op_*` methods)
    #[must_use]
    pub fn operators(&self) -> Vec<MethodRc> {
        self.all_methods()
            .into_iter()
            .filter(|method| method.kind == MethodKind::Operator)
            .collect()
    }

    fn member_handles(&self, rows: impl FnOnce(&ModuleRc) -> Vec<u32>) -> Vec<MemberHandle> {
        match (self.definition_token(), self.module()) {
            (Some(_), Some(module)) => rows(&module)
                .into_iter()
                .map(|row| MemberHandle {
                    declaring: self.handle.clone(),
                    module: module.id(),
                    row,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn properties(&self) -> Vec<PropertyRc> {
        let Some(provider) = self.inner() else {
            return Vec::new();
        };
        self.member_handles(|module| module.tables().properties_of(self.row))
            .iter()
            .filter_map(|handle| logged(provider.get_property(handle), &self.name))
            .collect()
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn fields(&self) -> Vec<FieldRc> {
        let Some(provider) = self.inner() else {
            return Vec::new();
        };
        self.member_handles(|module| module.tables().fields_of(self.row))
            .iter()
            .filter_map(|handle| logged(provider.get_field(handle), &self.name))
            .collect()
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn events(&self) -> Vec<EventRc> {
        let Some(provider) = self.inner() else {
            return Vec::new();
        };
        self.member_handles(|module| module.tables().events_of(self.row))
            .iter()
            .filter_map(|handle| logged(provider.get_event(handle), &self.name))
            .collect()
    }

    /// Types declared inside this type. Nested types of a constructed type are constructed over
    /// the same arguments; parameters the nested type adds stay open.
    #[must_use]
    pub fn nested_types(&self) -> Vec<TypeRc> {
        let (Some(provider), Some(module)) = (self.inner(), self.module()) else {
            return Vec::new();
        };
        if self.definition_token().is_none() {
            return Vec::new();
        }
        module
            .nested_types(self.row)
            .iter()
            .filter_map(|nested| {
                let definition = TypeHandle::definition(module.id(), *nested);
                let handle = match &self.handle {
                    TypeHandle::Instance { arguments, .. } => {
                        let mut full = arguments.clone();
                        full.extend(
                            provider
                                .own_parameters(&module, *nested)
                                .into_iter()
                                .skip(arguments.len()),
                        );
                        provider.canonical_type(&TypeHandle::Instance {
                            definition: Box::new(definition),
                            arguments: full,
                        })
                    }
                    _ => definition,
                };
                self.resolve(&handle)
            })
            .collect()
    }

    /// Every member in the order constructors, methods, operators, properties, fields, events,
    /// nested types
    #[must_use]
    pub fn members(&self) -> Vec<Member> {
        let mut members: Vec<Member> = Vec::new();
        members.extend(self.constructors().into_iter().map(Member::Constructor));
        members.extend(self.methods().into_iter().map(Member::Method));
        members.extend(self.operators().into_iter().map(Member::Operator));
        members.extend(self.properties().into_iter().map(Member::Property));
        members.extend(self.fields().into_iter().map(Member::Field));
        members.extend(self.events().into_iter().map(Member::Event));
        members.extend(self.nested_types().into_iter().map(Member::Type));
        members
    }

    /// The first method or operator named `name`
    #[must_use]
    pub fn method(&self, name: &str) -> Option<MethodRc> {
        self.all_methods()
            .into_iter()
            .find(|method| method.kind != MethodKind::Constructor && method.name == name)
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn property(&self, name: &str) -> Option<PropertyRc> {
        self.properties()
            .into_iter()
            .find(|property| property.name == name)
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn field(&self, name: &str) -> Option<FieldRc> {
        self.fields().into_iter().find(|field| field.name == name)
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn event(&self, name: &str) -> Option<EventRc> {
        self.events().into_iter().find(|event| event.name == name)
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn nested_type(&self, name: &str) -> Option<TypeRc> {
        self.nested_types()
            .into_iter()
            .find(|nested| nested.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{
        builder::{
            EventBuilder, FieldBuilder, MethodBuilder, ModuleBuilder, ParameterBuilder,
            PropertyBuilder, TypeBuilder,
        },
        provider::MetadataProvider,
    };

    fn sample() -> (MetadataProvider, ModuleRc) {
        let mut module = ModuleBuilder::new("Members");
        let handler = module.core_type("System", "EventHandler").unwrap();
        let counter = TypeBuilder::class("N", "Counter").build(&mut module).unwrap();
        MethodBuilder::constructor().build(&mut module, counter).unwrap();
        MethodBuilder::constructor()
            .parameter(("start", TypeSignature::I4))
            .build(&mut module, counter)
            .unwrap();
        MethodBuilder::new("Add")
            .parameter(
                ParameterBuilder::new("amount", TypeSignature::I4).optional(ConstantValue::I4(1)),
            )
            .parameter(ParameterBuilder::new("total", TypeSignature::I8).out())
            .parameter(ParameterBuilder::new("limit", TypeSignature::I8).in_ref())
            .parameter(ParameterBuilder::new("state", TypeSignature::Object).by_ref())
            .parameter(
                ParameterBuilder::new(
                    "rest",
                    TypeSignature::SzArray(Box::new(TypeSignature::Object)),
                )
                .params_array(),
            )
            .build(&mut module, counter)
            .unwrap();
        MethodBuilder::operator("op_Addition")
            .returns(TypeSignature::Class(counter))
            .parameter(("left", TypeSignature::Class(counter)))
            .parameter(("right", TypeSignature::Class(counter)))
            .build(&mut module, counter)
            .unwrap();
        let get_value = MethodBuilder::new("get_Value")
            .add_flags(MethodAttributes::SPECIAL_NAME)
            .returns(TypeSignature::I4)
            .build(&mut module, counter)
            .unwrap();
        let set_value = MethodBuilder::new("set_Value")
            .flags(
                MethodAttributes::PRIVATE
                    | MethodAttributes::HIDE_BY_SIG
                    | MethodAttributes::SPECIAL_NAME,
            )
            .parameter(("value", TypeSignature::I4))
            .build(&mut module, counter)
            .unwrap();
        PropertyBuilder::new("Value", TypeSignature::I4)
            .getter(get_value)
            .setter(set_value)
            .build(&mut module, counter)
            .unwrap();
        FieldBuilder::new("Limit", TypeSignature::I4)
            .flags(FieldAttributes::PUBLIC | FieldAttributes::STATIC | FieldAttributes::LITERAL)
            .constant(ConstantValue::I4(100))
            .build(&mut module, counter)
            .unwrap();
        let add_changed = MethodBuilder::new("add_Changed")
            .add_flags(MethodAttributes::SPECIAL_NAME)
            .parameter(("value", TypeSignature::Class(handler)))
            .build(&mut module, counter)
            .unwrap();
        let remove_changed = MethodBuilder::new("remove_Changed")
            .add_flags(MethodAttributes::SPECIAL_NAME)
            .parameter(("value", TypeSignature::Class(handler)))
            .build(&mut module, counter)
            .unwrap();
        EventBuilder::new("Changed", TypeSignature::Class(handler))
            .adder(add_changed)
            .remover(remove_changed)
            .build(&mut module, counter)
            .unwrap();
        TypeBuilder::class("", "Snapshot")
            .nested_in(counter)
            .build(&mut module)
            .unwrap();

        let module = module.build().unwrap();
        let provider = MetadataProvider::new();
        provider.register_module(&module);
        (provider, module)
    }

    #[test]
    fn member_lists() {
        let (provider, _module) = sample();
        let counter = provider.find_type_by_full_name("N.Counter").unwrap();

        assert_eq!(counter.constructors().len(), 2);
        let methods: Vec<String> = counter.methods().iter().map(|m| m.name().to_string()).collect();
        assert_eq!(methods, ["Add"]);
        assert_eq!(counter.operators()[0].kind(), MethodKind::Operator);
        assert_eq!(counter.properties().len(), 1);
        assert_eq!(counter.fields().len(), 1);
        assert_eq!(counter.events().len(), 1);
        assert_eq!(counter.nested_types()[0].name(), "Snapshot");

        let kinds: Vec<&str> = counter.members().iter().map(Member::kind_name).collect();
        assert_eq!(
            kinds,
            [
                "constructor",
                "constructor",
                "method",
                "operator",
                "property",
                "field",
                "event",
                "type"
            ]
        );
    }

    #[test]
    fn parameters() {
        let (provider, _module) = sample();
        let counter = provider.find_type_by_full_name("N.Counter").unwrap();
        let add = counter.method("Add").unwrap();
        let parameters = add.parameters();
        assert_eq!(parameters.len(), 5);

        assert_eq!(parameters[0].name(), "amount");
        assert!(parameters[0].is_optional());
        assert_eq!(parameters[0].default(), Some(ConstantValue::I4(1)));
        assert_eq!(parameters[0].ref_kind(), RefKind::None);
        assert_eq!(parameters[1].ref_kind(), RefKind::Out);
        assert_eq!(parameters[2].ref_kind(), RefKind::In);
        assert_eq!(parameters[3].ref_kind(), RefKind::Ref);
        assert!(parameters[4].is_params_array());
        assert!(parameters[4].is_array());
        assert_eq!(parameters[4].position(), 4);
        assert_eq!(
            parameters[1].parameter_type().unwrap().full_name(),
            "System.Int64&"
        );
        assert_eq!(add.return_type().unwrap().full_name(), "System.Void");
    }

    #[test]
    fn accessors_and_constants() {
        let (provider, _module) = sample();
        let counter = provider.find_type_by_full_name("N.Counter").unwrap();

        let value = counter.property("Value").unwrap();
        assert_eq!(value.property_type().unwrap().full_name(), "System.Int32");
        assert_eq!(value.getter().unwrap().name(), "get_Value");
        assert_eq!(value.setter().unwrap().visibility(), Visibility::Private);
        assert_eq!(value.visibility(), Visibility::Public);
        assert!(!value.is_static());

        let getter = value.getter().unwrap();
        assert!(getter.is_accessor());
        assert_eq!(
            getter.associated_member().unwrap(),
            Member::Property(value.clone())
        );

        let limit = counter.field("Limit").unwrap();
        assert!(limit.is_literal());
        assert_eq!(limit.constant(), Some(ConstantValue::I4(100)));

        let changed = counter.event("Changed").unwrap();
        assert_eq!(changed.event_type().unwrap().full_name(), "System.EventHandler");
        assert_eq!(changed.adder().unwrap().name(), "add_Changed");
        assert!(changed.raiser().is_none());
    }

    #[test]
    fn members_of_constructed_types() {
        let mut module = ModuleBuilder::new("Generic");
        let boxed = TypeBuilder::class("N", "Box`1")
            .generic_parameter("T")
            .build(&mut module)
            .unwrap();
        FieldBuilder::new("Value", TypeSignature::GenericParamType(0))
            .build(&mut module, boxed)
            .unwrap();
        MethodBuilder::new("Map`1")
            .generic_parameter("U")
            .returns(TypeSignature::GenericParamMethod(0))
            .parameter(("value", TypeSignature::GenericParamType(0)))
            .build(&mut module, boxed)
            .unwrap();
        let module = module.build().unwrap();
        let provider = MetadataProvider::new();
        provider.register_module(&module);

        let boxed = provider.find_type_by_full_name("N.Box`1").unwrap();
        let int = provider.find_type_by_full_name("System.Int32").unwrap();
        let string = provider.find_type_by_full_name("System.String").unwrap();
        let closed = boxed.make_generic_type(&[int.clone()]).unwrap();

        let field = closed.field("Value").unwrap();
        assert_eq!(field.field_type().unwrap(), int);
        assert_eq!(field.declaring_type().unwrap(), closed);
        assert_ne!(field.handle(), boxed.field("Value").unwrap().handle());

        let map = closed.method("Map`1").unwrap();
        assert!(map.is_generic_method_definition());
        assert_eq!(map.parameter_types()[0], int);
        assert!(map.return_type().unwrap().is_generic_parameter());

        let mapped = map.make_generic_method(&[string.clone()]).unwrap();
        assert!(mapped.is_constructed_generic_method());
        assert_eq!(mapped.return_type().unwrap(), string);
        assert_eq!(mapped.generic_method_definition().unwrap(), map);
        assert_eq!(
            mapped.member_definition(),
            boxed.method("Map`1").unwrap()
        );
        assert!(matches!(
            mapped.make_generic_method(&[int]),
            Err(Error::InvalidArgument(_))
        ));
    }
}
