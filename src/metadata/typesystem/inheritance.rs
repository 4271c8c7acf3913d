//! Override, interface implementation and overload links between members.
//!
//! Links are computed on the member as declared on the generic definition and then projected
//! onto the constructed declaring type, so `Derived<int>.Run` reports `Base<int>.Run` the same way
//! `Derived<T>.Run` reports `Base<T>.Run`.

use std::sync::Arc;

use crate::{
    metadata::{
        binding::Scope,
        comparer::method_parameters,
        flags::{MethodAttributes, Visibility},
        handle::{MethodHandle, TypeHandle},
        module::ModuleRc,
        provider::ProviderInner,
        signatures::parse_method_signature,
        tables::{row, TableId},
        token::Token,
        typesystem::{
            logged, Event, EventRc, Member, Method, MethodKind, MethodRc, Property, PropertyRc,
        },
    },
    Error, Result,
};

impl ProviderInner {
    /// The method a `MethodDef` or `MemberRef` token of `module` refers to.
    ///
    /// `MemberRef` rows are matched by name, generic arity and parameter count on their parent
    /// type.
    fn method_token(
        self: &Arc<Self>,
        module: &ModuleRc,
        scope: Scope,
        token: Token,
    ) -> Result<MethodRc> {
        if token.is_table(TableId::MethodDef) {
            let type_row = module
                .declaring_type(token)
                .ok_or(Error::TokenNotFound(token))?;
            return self.get_method(&MethodHandle {
                declaring: TypeHandle::definition(module.id(), type_row),
                module: module.id(),
                row: token.row(),
                arguments: Vec::new(),
            });
        }
        if !token.is_table(TableId::MemberRef) {
            return Err(Error::TokenNotFound(token));
        }

        let reference =
            row(&module.tables().member_ref, token.row()).ok_or(Error::TokenNotFound(token))?;
        let signature = parse_method_signature(&reference.signature)?;
        let parent = self.get_type(&self.type_token(module, scope, reference.class)?)?;
        parent
            .all_methods()
            .into_iter()
            .find(|method| {
                method.name() == reference.name
                    && method.generic_count() == signature.param_count_generic as usize
                    && method.parameter_type_handles().len() == signature.params.len()
            })
            .ok_or(Error::TokenNotFound(token))
    }
}

impl Method {
    /// Returns true if `other` has the name and parameter types of this method. Generic methods
    /// are compared with `other` instantiated over this method's own parameters.
    fn same_signature(&self, other: &Method) -> bool {
        if self.name() != other.name() || self.generic_count() != other.generic_count() {
            return false;
        }
        if self.generic_count() == 0 {
            return self.parameter_type_handles() == other.parameter_type_handles();
        }
        let (Some(provider), Some(module)) = (self.inner(), self.module()) else {
            return false;
        };
        let instantiated = MethodHandle {
            arguments: method_parameters(&module, self.handle().row, self.generic_count()),
            ..other.handle().clone()
        };
        logged(provider.get_method(&instantiated), self.name()).is_some_and(|other| {
            self.parameter_type_handles() == other.parameter_type_handles()
        })
    }

    /// Moves a link found on the generic definition onto this method's declaring instance
    fn project(&self, found: MethodRc) -> MethodRc {
        let TypeHandle::Instance { arguments, .. } = &self.handle().declaring else {
            if self.handle().arguments.is_empty() || found.generic_count() == 0 {
                return found;
            }
            return self
                .inner()
                .and_then(|provider| {
                    let handle = MethodHandle {
                        arguments: self.handle().arguments.clone(),
                        ..found.handle().clone()
                    };
                    logged(provider.get_method(&handle), self.name())
                })
                .unwrap_or(found);
        };
        let Some(provider) = self.inner() else {
            return found;
        };
        let handle = MethodHandle {
            declaring: provider
                .canonical_type(&found.handle().declaring.substitute(arguments, &[])),
            arguments: if found.generic_count() == 0 {
                Vec::new()
            } else {
                self.handle().arguments.clone()
            },
            ..found.handle().clone()
        };
        logged(provider.get_method(&handle), self.name()).unwrap_or(found)
    }

    /// The declaration bound to this method by a `MethodImpl` row of its declaring type
    fn explicit_declaration(&self) -> Option<MethodRc> {
        let module = self.module()?;
        let provider = self.inner()?;
        let (_, declaration) = module
            .method_impls(self.declaring_row())
            .iter()
            .find(|(body, _)| *body == self.token())?;
        logged(
            provider.method_token(&module, Scope::of_type(self.declaring_row()), *declaration),
            self.name(),
        )
    }

    /// Every declaration bound explicitly by `MethodImpl` rows of the declaring type
    fn explicitly_implemented(&self) -> Vec<MethodRc> {
        let (Some(module), Some(provider)) = (self.module(), self.inner()) else {
            return Vec::new();
        };
        let scope = Scope::of_type(self.declaring_row());
        module
            .method_impls(self.declaring_row())
            .iter()
            .filter_map(|(_, declaration)| {
                logged(provider.method_token(&module, scope, *declaration), self.name())
            })
            .collect()
    }

    fn overridden_on_definition(&self) -> Option<MethodRc> {
        if self.kind() == MethodKind::Constructor
            || !self.is_virtual()
            || self.flags().contains(MethodAttributes::NEW_SLOT)
        {
            return None;
        }
        if let Some(declaration) = self.explicit_declaration() {
            if !declaration.declaring_type()?.is_interface() {
                return Some(declaration);
            }
        }
        self.declaring_type()?
            .base_type_hierarchy()
            .iter()
            .rev()
            .find_map(|base| {
                base.all_methods()
                    .into_iter()
                    .find(|candidate| candidate.is_virtual() && self.same_signature(candidate))
            })
    }

    fn implemented_on_definition(&self) -> Option<MethodRc> {
        if let Some(declaration) = self.explicit_declaration() {
            if declaration.declaring_type()?.is_interface() {
                return Some(declaration);
            }
        }
        if self.is_static() || self.visibility() != Visibility::Public {
            return None;
        }

        let explicit: Vec<MethodHandle> = self
            .explicitly_implemented()
            .iter()
            .map(|method| method.handle().clone())
            .collect();
        self.declaring_type()?
            .implemented_interfaces()
            .iter()
            .find_map(|interface| {
                interface.all_methods().into_iter().find(|candidate| {
                    !explicit.contains(candidate.handle()) && self.same_signature(candidate)
                })
            })
    }

    /// The base class method this method overrides
    #[must_use]
    pub fn overridden_method(self: &Arc<Self>) -> Option<MethodRc> {
        let found = self.member_definition().overridden_on_definition()?;
        Some(self.project(found))
    }

    /// The interface method this method implements, explicitly through a `MethodImpl` row or
    /// implicitly as a public method with the interface method's name and signature
    #[must_use]
    pub fn implemented_method(self: &Arc<Self>) -> Option<MethodRc> {
        let found = self.member_definition().implemented_on_definition()?;
        Some(self.project(found))
    }

    /// Returns true if this method is bound to an interface method only through a `MethodImpl`
    /// row
    #[must_use]
    pub fn is_explicit_implementation(&self) -> bool {
        self.explicit_declaration()
            .and_then(|declaration| declaration.declaring_type())
            .is_some_and(|interface| interface.is_interface())
    }

    /// Methods of the declaring type with the same name and kind, excluding this one
    #[must_use]
    pub fn overloads(&self) -> Vec<MethodRc> {
        let Some(declaring) = self.declaring_type() else {
            return Vec::new();
        };
        declaring
            .all_methods()
            .into_iter()
            .filter(|method| {
                method.kind() == self.kind()
                    && method.name() == self.name()
                    && method.handle() != self.handle()
            })
            .collect()
    }

    /// The base type constructor with the same parameter types
    fn inherited_constructor(&self) -> Option<MethodRc> {
        self.declaring_type()?
            .base_type()?
            .constructors()
            .into_iter()
            .find(|ctor| {
                ctor.is_static() == self.is_static()
                    && ctor.parameter_type_handles() == self.parameter_type_handles()
            })
    }
}

/// The property of the first accessor in `accessors` that `link` maps to one
fn linked_property(
    accessors: Vec<MethodRc>,
    link: impl Fn(&MethodRc) -> Option<MethodRc>,
) -> Option<PropertyRc> {
    accessors.iter().find_map(|accessor| {
        link(accessor)?
            .associated_member()?
            .as_property()
            .cloned()
    })
}

fn linked_event(
    accessors: Vec<MethodRc>,
    link: impl Fn(&MethodRc) -> Option<MethodRc>,
) -> Option<EventRc> {
    accessors
        .iter()
        .find_map(|accessor| link(accessor)?.associated_member()?.as_event().cloned())
}

impl Property {
    /// The base class property this property overrides
    #[must_use]
    pub fn overridden_property(&self) -> Option<PropertyRc> {
        linked_property(self.accessors(), Method::overridden_method)
    }

    /// The interface property this property implements
    #[must_use]
    pub fn implemented_property(&self) -> Option<PropertyRc> {
        linked_property(self.accessors(), Method::implemented_method)
    }

    /// Returns true if every accessor is an explicit interface implementation
    #[must_use]
    pub fn is_explicit_implementation(&self) -> bool {
        let accessors = self.accessors();
        !accessors.is_empty()
            && accessors
                .iter()
                .all(|accessor| accessor.is_explicit_implementation())
    }

    /// Properties of the declaring type with the same name (indexers), excluding this one
    #[must_use]
    pub fn overloads(&self) -> Vec<PropertyRc> {
        let Some(declaring) = self.declaring_type() else {
            return Vec::new();
        };
        declaring
            .properties()
            .into_iter()
            .filter(|property| property.name() == self.name() && property.handle() != self.handle())
            .collect()
    }
}

impl Event {
    /// The base class event this event overrides
    #[must_use]
    pub fn overridden_event(&self) -> Option<EventRc> {
        linked_event(self.accessors(), Method::overridden_method)
    }

    /// The interface event this event implements
    #[must_use]
    pub fn implemented_event(&self) -> Option<EventRc> {
        linked_event(self.accessors(), Method::implemented_method)
    }

    /// Returns true if every accessor is an explicit interface implementation
    #[must_use]
    pub fn is_explicit_implementation(&self) -> bool {
        let accessors = self.accessors();
        !accessors.is_empty()
            && accessors
                .iter()
                .all(|accessor| accessor.is_explicit_implementation())
    }
}

/// The member `member` most directly overrides or implements.
///
/// Constructors map to the base type constructor with the same parameter types. Methods,
/// operators, properties and events report the member they override, else the interface member
/// they implement. Fields, types and parameters never inherit.
#[must_use]
pub fn get_inherited_member(member: &Member) -> Option<Member> {
    match member {
        Member::Constructor(ctor) => ctor.inherited_constructor().map(Member::Constructor),
        Member::Method(method) | Member::Operator(method) => method
            .overridden_method()
            .or_else(|| method.implemented_method())
            .map(Member::from),
        Member::Property(property) => property
            .overridden_property()
            .or_else(|| property.implemented_property())
            .map(Member::Property),
        Member::Event(event) => event
            .overridden_event()
            .or_else(|| event.implemented_event())
            .map(Member::Event),
        Member::Field(_) | Member::Type(_) | Member::TypeParameter(_) | Member::Parameter(_) => {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{
        builder::{MethodBuilder, ModuleBuilder, PropertyBuilder, TypeBuilder},
        provider::MetadataProvider,
        signatures::{SignatureMethod, SignatureParameter, TypeSignature},
        typesystem::TypeRc,
    };

    fn instance(definition: Token, arguments: Vec<TypeSignature>) -> TypeSignature {
        TypeSignature::GenericInst(Box::new(TypeSignature::Class(definition)), arguments)
    }

    fn shapes() -> (MetadataProvider, ModuleRc) {
        let mut module = ModuleBuilder::new("Shapes");
        let comparable = module.core_type("System", "IComparable`1").unwrap();

        let shape = TypeBuilder::interface("S", "IShape").build(&mut module).unwrap();
        let get_area = MethodBuilder::new("get_Area")
            .abstract_method()
            .add_flags(MethodAttributes::SPECIAL_NAME)
            .returns(TypeSignature::R8)
            .build(&mut module, shape)
            .unwrap();
        PropertyBuilder::new("Area", TypeSignature::R8)
            .getter(get_area)
            .build(&mut module, shape)
            .unwrap();
        MethodBuilder::new("Scale")
            .abstract_method()
            .parameter(("factor", TypeSignature::R8))
            .build(&mut module, shape)
            .unwrap();

        let base = TypeBuilder::class("S", "Base`1")
            .generic_parameter("T")
            .build(&mut module)
            .unwrap();
        MethodBuilder::constructor()
            .parameter(("seed", TypeSignature::GenericParamType(0)))
            .build(&mut module, base)
            .unwrap();
        MethodBuilder::new("Run")
            .virtual_method()
            .parameter(("value", TypeSignature::GenericParamType(0)))
            .build(&mut module, base)
            .unwrap();
        MethodBuilder::new("Run")
            .virtual_method()
            .parameter(("value", TypeSignature::String))
            .build(&mut module, base)
            .unwrap();
        let get_name = MethodBuilder::new("get_Name")
            .virtual_method()
            .add_flags(MethodAttributes::SPECIAL_NAME)
            .returns(TypeSignature::String)
            .build(&mut module, base)
            .unwrap();
        PropertyBuilder::new("Name", TypeSignature::String)
            .getter(get_name)
            .build(&mut module, base)
            .unwrap();

        let square = TypeBuilder::class("S", "Square`1")
            .generic_parameter("T")
            .extends(instance(base, vec![TypeSignature::GenericParamType(0)]))
            .implements(TypeSignature::Class(shape))
            .build(&mut module)
            .unwrap();
        module
            .add_interface(
                square,
                &instance(
                    comparable,
                    vec![instance(square, vec![TypeSignature::GenericParamType(0)])],
                ),
            )
            .unwrap();
        MethodBuilder::constructor()
            .parameter(("seed", TypeSignature::GenericParamType(0)))
            .build(&mut module, square)
            .unwrap();
        MethodBuilder::new("Run")
            .override_method()
            .parameter(("value", TypeSignature::GenericParamType(0)))
            .build(&mut module, square)
            .unwrap();
        MethodBuilder::new("Run")
            .virtual_method()
            .parameter(("value", TypeSignature::String))
            .build(&mut module, square)
            .unwrap();
        let square_area = MethodBuilder::new("S.IShape.get_Area")
            .flags(
                MethodAttributes::PRIVATE
                    | MethodAttributes::VIRTUAL
                    | MethodAttributes::FINAL
                    | MethodAttributes::NEW_SLOT
                    | MethodAttributes::HIDE_BY_SIG
                    | MethodAttributes::SPECIAL_NAME,
            )
            .returns(TypeSignature::R8)
            .implements(get_area)
            .build(&mut module, square)
            .unwrap();
        PropertyBuilder::new("S.IShape.Area", TypeSignature::R8)
            .getter(square_area)
            .build(&mut module, square)
            .unwrap();
        MethodBuilder::new("Scale")
            .virtual_method()
            .add_flags(MethodAttributes::FINAL)
            .parameter(("factor", TypeSignature::R8))
            .build(&mut module, square)
            .unwrap();
        let compare_to = module
            .method_ref(
                &instance(
                    comparable,
                    vec![instance(square, vec![TypeSignature::GenericParamType(0)])],
                ),
                "CompareTo",
                &SignatureMethod {
                    has_this: true,
                    return_type: SignatureParameter::new(TypeSignature::I4),
                    params: vec![SignatureParameter::new(TypeSignature::GenericParamType(0))],
                    ..SignatureMethod::default()
                },
            )
            .unwrap();
        MethodBuilder::new("System.IComparable<S.Square<T>>.CompareTo")
            .flags(
                MethodAttributes::PRIVATE
                    | MethodAttributes::VIRTUAL
                    | MethodAttributes::FINAL
                    | MethodAttributes::NEW_SLOT
                    | MethodAttributes::HIDE_BY_SIG,
            )
            .returns(TypeSignature::I4)
            .parameter(("other", instance(square, vec![TypeSignature::GenericParamType(0)])))
            .implements(compare_to)
            .build(&mut module, square)
            .unwrap();

        let module = module.build().unwrap();
        let provider = MetadataProvider::new();
        provider.register_module(&module);
        (provider, module)
    }

    fn method_with(ty: &TypeRc, name: &str, parameter: &str) -> MethodRc {
        ty.all_methods()
            .into_iter()
            .find(|method| {
                method.name() == name
                    && method
                        .parameter_types()
                        .first()
                        .is_some_and(|p| p.name() == parameter)
            })
            .unwrap()
    }

    #[test]
    fn overrides() {
        let (provider, _module) = shapes();
        let base = provider.find_type_by_full_name("S.Base`1").unwrap();
        let square = provider.find_type_by_full_name("S.Square`1").unwrap();

        let run = method_with(&square, "Run", "T");
        let base_run = run.overridden_method().unwrap();
        assert_eq!(base_run.declaring_type().unwrap().generic_type_definition().unwrap(), base);
        assert_eq!(base_run.parameter_types()[0], run.parameter_types()[0]);
        assert_eq!(
            get_inherited_member(&Member::Method(run.clone())),
            Some(Member::Method(base_run))
        );

        // A new slot hides instead of overriding
        let run_string = method_with(&square, "Run", "String");
        assert!(run_string.overridden_method().is_none());
        assert!(get_inherited_member(&Member::Method(run_string.clone())).is_none());
        assert_eq!(run.overloads(), [run_string]);

        let int = provider.find_type_by_full_name("System.Int32").unwrap();
        let closed = square.make_generic_type(&[int.clone()]).unwrap();
        let closed_run = method_with(&closed, "Run", "Int32");
        let closed_base_run = closed_run.overridden_method().unwrap();
        assert_eq!(
            closed_base_run.declaring_type().unwrap(),
            base.make_generic_type(&[int]).unwrap()
        );
        assert_eq!(closed_base_run.parameter_types()[0].full_name(), "System.Int32");
    }

    #[test]
    fn constructors_and_fields() {
        let (provider, _module) = shapes();
        let square = provider.find_type_by_full_name("S.Square`1").unwrap();
        let ctor = square.constructors().into_iter().next().unwrap();
        let inherited = get_inherited_member(&Member::Constructor(ctor)).unwrap();
        assert_eq!(inherited.kind_name(), "constructor");
        assert_eq!(inherited.declaring_type().unwrap().name(), "Base`1");

        let object = provider.find_type_by_full_name("System.Object").unwrap();
        let to_string = object.method("ToString").unwrap();
        assert!(get_inherited_member(&Member::Method(to_string)).is_none());
    }

    #[test]
    fn interface_implementations() {
        let (provider, _module) = shapes();
        let square = provider.find_type_by_full_name("S.Square`1").unwrap();
        let shape = provider.find_type_by_full_name("S.IShape").unwrap();

        let scale = square.method("Scale").unwrap();
        assert!(scale.overridden_method().is_none());
        assert_eq!(scale.implemented_method().unwrap(), shape.method("Scale").unwrap());
        assert!(!scale.is_explicit_implementation());

        let explicit = square.method("S.IShape.get_Area").unwrap();
        assert!(explicit.is_explicit_implementation());
        assert_eq!(
            explicit.implemented_method().unwrap(),
            shape.method("get_Area").unwrap()
        );
        // Operators and explicit accessors keep the special-name bit exactly as emitted
        assert!(explicit.is_special_name());

        let area = square.property("S.IShape.Area").unwrap();
        assert!(area.is_explicit_implementation());
        assert_eq!(area.implemented_property().unwrap(), shape.property("Area").unwrap());
        assert_eq!(
            get_inherited_member(&Member::Property(area)),
            Some(Member::Property(shape.property("Area").unwrap()))
        );

        let compare = square
            .method("System.IComparable<S.Square<T>>.CompareTo")
            .unwrap();
        assert!(compare.is_explicit_implementation());
        let declaration = compare.implemented_method().unwrap();
        assert_eq!(declaration.name(), "CompareTo");
        let interface = declaration.declaring_type().unwrap();
        assert_eq!(interface.name(), "IComparable`1");
        assert_eq!(interface.type_arguments()[0].name(), "Square`1");
    }
}
