//! Binding parsed references to metadata objects.

use std::sync::Arc;

use crate::metadata::{
    coderef::{
        format::{encode_member_name, type_name, type_names},
        CodeReference, ReferenceKind, TypeName,
    },
    handle::TypeHandle,
    provider::{MetadataProvider, ProviderInner},
    typesystem::{Member, MethodRc, TypeRc},
};

/// Finds the type definition named by `segments`: a namespace prefix followed by the
/// outermost type and its nested types. Longer namespaces are tried first.
fn find_type(provider: &MetadataProvider, segments: &[String]) -> Option<TypeRc> {
    if segments.is_empty() {
        return None;
    }
    provider.inner().search_order().iter().find_map(|module| {
        (0..segments.len()).rev().find_map(|split| {
            let namespace = segments[..split].join(".");
            let mut row = module.find_type(&namespace, &segments[split])?;
            for nested in &segments[split + 1..] {
                row = module.find_nested(row, nested)?;
            }
            provider
                .get_type(&TypeHandle::definition(module.id(), row))
                .ok()
        })
    })
}

/// Picks the candidate whose signature matches `parameters`; without a parameter list the
/// candidate taking no parameters wins, then the first one.
fn select<T>(
    candidates: Vec<T>,
    parameters: Option<&[TypeName]>,
    signature: impl Fn(&T) -> Option<Vec<TypeName>>,
) -> Option<T> {
    match parameters {
        Some(parameters) => candidates
            .into_iter()
            .find(|candidate| signature(candidate).is_some_and(|found| found == parameters)),
        None => {
            let index = candidates
                .iter()
                .position(|candidate| signature(candidate).is_some_and(|found| found.is_empty()))
                .unwrap_or(0);
            candidates.into_iter().nth(index)
        }
    }
}

fn resolve_method(
    provider: &Arc<ProviderInner>,
    declaring: &TypeRc,
    reference: &CodeReference,
    name: &str,
) -> Option<MethodRc> {
    let candidates: Vec<MethodRc> = declaring
        .all_methods()
        .into_iter()
        .filter(|method| encode_member_name(method.name()) == name)
        .filter(|method| {
            reference
                .generic_arity()
                .is_none_or(|arity| method.generic_count() == arity as usize)
        })
        .filter(|method| {
            reference.return_type().is_none_or(|expected| {
                type_name(provider, method.return_type_handle()).as_ref() == Some(expected)
            })
        })
        .collect();
    select(candidates, reference.parameters(), |method| {
        type_names(provider, method.parameter_type_handles())
    })
}

impl CodeReference {
    /// Binds this reference to the member it names.
    ///
    /// The declaring type is looked up in the registered modules, then in the core library.
    /// Namespace references and references that do not bind resolve to `None`.
    #[must_use]
    pub fn resolve(&self, provider: &MetadataProvider) -> Option<Member> {
        let resolved = self.bind(provider);
        if resolved.is_none() {
            tracing::trace!(reference = %self, "code reference did not bind");
        }
        resolved
    }

    fn bind(&self, provider: &MetadataProvider) -> Option<Member> {
        match self.kind {
            ReferenceKind::Namespace => None,
            ReferenceKind::Type => find_type(provider, &self.path).map(Member::Type),
            ReferenceKind::Method => {
                let declaring = find_type(provider, &self.path)?;
                let name = self.member.as_deref()?;
                resolve_method(provider.inner(), &declaring, self, name).map(Member::from)
            }
            ReferenceKind::Property => {
                let declaring = find_type(provider, &self.path)?;
                let name = self.member.as_deref()?;
                let candidates = declaring
                    .properties()
                    .into_iter()
                    .filter(|property| encode_member_name(property.name()) == name)
                    .collect();
                select(candidates, self.parameters(), |property| {
                    type_names(provider.inner(), property.index_type_handles())
                })
                .map(Member::from)
            }
            ReferenceKind::Field => {
                let declaring = find_type(provider, &self.path)?;
                let name = self.member.as_deref()?;
                declaring
                    .fields()
                    .into_iter()
                    .find(|field| encode_member_name(field.name()) == name)
                    .map(Member::from)
            }
            ReferenceKind::Event => {
                let declaring = find_type(provider, &self.path)?;
                let name = self.member.as_deref()?;
                declaring
                    .events()
                    .into_iter()
                    .find(|event| encode_member_name(event.name()) == name)
                    .map(Member::from)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::metadata::{
        builder::{
            EventBuilder, FieldBuilder, MethodBuilder, ModuleBuilder, PropertyBuilder,
            TypeBuilder,
        },
        flags::{MethodAttributes, TypeAttributes},
        module::ModuleRc,
        provider::MetadataProvider,
        signatures::TypeSignature,
        token::Token,
        typesystem::Member,
    };

    fn instance(definition: Token, arguments: Vec<TypeSignature>) -> TypeSignature {
        TypeSignature::GenericInst(Box::new(TypeSignature::Class(definition)), arguments)
    }

    fn library() -> (MetadataProvider, ModuleRc) {
        let mut module = ModuleBuilder::new("Library");
        let handler = module.core_type("System", "EventHandler").unwrap();
        let enumerable = module
            .core_type("System.Collections.Generic", "IEnumerable`1")
            .unwrap();

        let outer = TypeBuilder::class("Lib", "Outer`1")
            .generic_parameter("T")
            .build(&mut module)
            .unwrap();
        let inner = TypeBuilder::class("", "Inner`1")
            .nested_in(outer)
            .generic_parameter("U")
            .build(&mut module)
            .unwrap();
        MethodBuilder::constructor()
            .parameter(("first", TypeSignature::GenericParamType(0)))
            .parameter(("second", TypeSignature::GenericParamType(1)))
            .build(&mut module, inner)
            .unwrap();
        MethodBuilder::type_initializer()
            .build(&mut module, inner)
            .unwrap();

        let shapes = TypeBuilder::class("Lib", "Shapes").build(&mut module).unwrap();
        MethodBuilder::constructor().build(&mut module, shapes).unwrap();
        MethodBuilder::new("Scale")
            .parameter(("factor", TypeSignature::I4))
            .build(&mut module, shapes)
            .unwrap();
        MethodBuilder::new("Scale")
            .parameter(("factor", TypeSignature::R8))
            .build(&mut module, shapes)
            .unwrap();
        MethodBuilder::new("Scale").build(&mut module, shapes).unwrap();
        MethodBuilder::new("Map")
            .generic_parameter("TSource")
            .generic_parameter("TResult")
            .returns(instance(enumerable, vec![TypeSignature::GenericParamMethod(1)]))
            .parameter((
                "source",
                instance(enumerable, vec![TypeSignature::GenericParamMethod(0)]),
            ))
            .parameter((
                "grid",
                TypeSignature::Array(Box::new(TypeSignature::GenericParamMethod(1)), 2),
            ))
            .parameter((
                "pointer",
                TypeSignature::ByRef(Box::new(TypeSignature::Ptr(Box::new(TypeSignature::I4)))),
            ))
            .build(&mut module, shapes)
            .unwrap();
        MethodBuilder::new("Wrap")
            .parameter((
                "outer",
                instance(outer, vec![TypeSignature::String]),
            ))
            .build(&mut module, shapes)
            .unwrap();
        MethodBuilder::operator("op_Implicit")
            .returns(TypeSignature::I4)
            .parameter(("value", TypeSignature::Class(shapes)))
            .build(&mut module, shapes)
            .unwrap();
        MethodBuilder::operator("op_Implicit")
            .returns(TypeSignature::I8)
            .parameter(("value", TypeSignature::Class(shapes)))
            .build(&mut module, shapes)
            .unwrap();
        MethodBuilder::new("Lib.IDrawable.Draw")
            .flags(
                MethodAttributes::PRIVATE
                    | MethodAttributes::HIDE_BY_SIG
                    | MethodAttributes::VIRTUAL
                    | MethodAttributes::FINAL
                    | MethodAttributes::NEW_SLOT,
            )
            .build(&mut module, shapes)
            .unwrap();
        let get_item = MethodBuilder::new("get_Item")
            .add_flags(MethodAttributes::SPECIAL_NAME)
            .returns(TypeSignature::String)
            .parameter(("index", TypeSignature::I4))
            .build(&mut module, shapes)
            .unwrap();
        PropertyBuilder::new("Item", TypeSignature::String)
            .index(TypeSignature::I4)
            .getter(get_item)
            .build(&mut module, shapes)
            .unwrap();
        FieldBuilder::new("Count", TypeSignature::I4)
            .build(&mut module, shapes)
            .unwrap();
        let add = MethodBuilder::new("add_Changed")
            .add_flags(MethodAttributes::SPECIAL_NAME)
            .parameter(("value", TypeSignature::Class(handler)))
            .build(&mut module, shapes)
            .unwrap();
        EventBuilder::new("Changed", TypeSignature::Class(handler))
            .adder(add)
            .build(&mut module, shapes)
            .unwrap();
        TypeBuilder::class("Lib.Deep", "Thing")
            .add_flags(TypeAttributes::SEALED)
            .build(&mut module)
            .unwrap();

        let module = module.build().unwrap();
        let provider = MetadataProvider::new();
        provider.register_module(&module);
        (provider, module)
    }

    fn resolve(provider: &MetadataProvider, reference: &str) -> Option<Member> {
        provider.resolve_member(reference)
    }

    #[test]
    fn references() {
        let (provider, _module) = library();
        let shapes = provider.find_type_by_full_name("Lib.Shapes").unwrap();
        let inner = provider.find_type_by_full_name("Lib.Outer`1+Inner`1").unwrap();

        assert_eq!(inner.code_reference(), "T:Lib.Outer`1.Inner`1");
        let references: Vec<String> = shapes
            .all_methods()
            .iter()
            .map(|method| method.code_reference())
            .collect();
        assert_eq!(
            references,
            [
                "M:Lib.Shapes.#ctor",
                "M:Lib.Shapes.Scale(System.Int32)",
                "M:Lib.Shapes.Scale(System.Double)",
                "M:Lib.Shapes.Scale",
                "M:Lib.Shapes.Map``2(System.Collections.Generic.IEnumerable{``0},``1[0:,0:],System.Int32*@)",
                "M:Lib.Shapes.Wrap(Lib.Outer{System.String})",
                "M:Lib.Shapes.op_Implicit(Lib.Shapes)~System.Int32",
                "M:Lib.Shapes.op_Implicit(Lib.Shapes)~System.Int64",
                "M:Lib.Shapes.Lib#IDrawable#Draw",
                "M:Lib.Shapes.get_Item(System.Int32)",
                "M:Lib.Shapes.add_Changed(System.EventHandler)",
            ]
        );
        let ctors: Vec<String> = inner
            .constructors()
            .iter()
            .map(|ctor| ctor.code_reference())
            .collect();
        assert_eq!(ctors, ["M:Lib.Outer`1.Inner`1.#ctor(`0,`1)", "M:Lib.Outer`1.Inner`1.#cctor"]);
        assert_eq!(
            shapes.property("Item").unwrap().code_reference(),
            "P:Lib.Shapes.Item(System.Int32)"
        );
        assert_eq!(shapes.field("Count").unwrap().code_reference(), "F:Lib.Shapes.Count");
        assert_eq!(shapes.event("Changed").unwrap().code_reference(), "E:Lib.Shapes.Changed");
    }

    #[test]
    fn round_trip() {
        let (provider, _module) = library();
        for full_name in ["Lib.Shapes", "Lib.Outer`1", "Lib.Outer`1+Inner`1", "Lib.Deep.Thing"] {
            let ty = provider.find_type_by_full_name(full_name).unwrap();
            let resolved = resolve(&provider, &ty.code_reference()).unwrap();
            assert_eq!(resolved, Member::Type(ty.clone()), "{full_name}");
            for member in ty.members() {
                let reference = member.code_reference();
                assert_eq!(
                    resolve(&provider, &reference).as_ref(),
                    Some(&member),
                    "{reference}"
                );
            }
        }
    }

    #[test]
    fn overload_selection() {
        let (provider, _module) = library();
        let scale = |reference: &str| match resolve(&provider, reference) {
            Some(Member::Method(method)) => method.parameter_types(),
            other => panic!("{reference} resolved to {other:?}"),
        };
        assert!(scale("M:Lib.Shapes.Scale").is_empty());
        assert_eq!(scale("M:Lib.Shapes.Scale()").len(), 0);
        assert_eq!(
            scale("M:Lib.Shapes.Scale(System.Double)")[0].full_name(),
            "System.Double"
        );
        assert!(resolve(&provider, "M:Lib.Shapes.Scale(System.String)").is_none());

        let Some(Member::Operator(conversion)) =
            resolve(&provider, "M:Lib.Shapes.op_Implicit(Lib.Shapes)~System.Int64")
        else {
            panic!("conversion operator did not resolve");
        };
        assert_eq!(conversion.return_type().unwrap().full_name(), "System.Int64");

        // alternative array spelling and a required arity
        assert!(resolve(
            &provider,
            "M:Lib.Shapes.Map``2(System.Collections.Generic.IEnumerable{``0},``1[,],System.Int32*@)"
        )
        .is_some());
        assert!(resolve(&provider, "M:Lib.Shapes.Map``3").is_none());
        assert!(resolve(&provider, "M:Lib.Shapes.Map").is_some());
    }

    #[test]
    fn soft_failures() {
        let (provider, _module) = library();
        for reference in [
            "",
            "garbage",
            "N:Lib",
            "T:Lib.Missing",
            "T:Lib.Shapes.Missing",
            "M:Lib.Shapes.Missing",
            "F:Lib.Shapes.Scale",
            "M:Lib.Shapes.Scale(System.Int32",
            "E:Lib.Shapes.Count",
        ] {
            assert!(resolve(&provider, reference).is_none(), "{reference:?}");
        }
    }

    #[test]
    fn core_library_fallback() {
        let provider = MetadataProvider::new();
        let Some(Member::Type(string)) = resolve(&provider, "T:System.String") else {
            panic!("core type did not resolve");
        };
        assert_eq!(string.full_name(), "System.String");
        assert!(matches!(
            resolve(&provider, "P:System.String.Length"),
            Some(Member::Property(_))
        ));
        assert!(matches!(
            resolve(&provider, "M:System.Nullable`1.#ctor(`0)"),
            Some(Member::Constructor(_))
        ));
    }
}
