//! Integration tests for documentation code references: formatting, parsing and resolution.

mod common;

use common::{registered, ty};
use dotdoc::prelude::*;

/// Every member of the fixture resolves back to itself from its own reference.
#[test]
fn round_trip_over_the_type_graph() -> Result<()> {
    let (provider, module) = registered()?;
    let mut checked = 0;
    for ty in provider.known_types() {
        if ty.module().map(|m| m.id()) != Some(module.id()) {
            continue;
        }
        let reference = ty.code_reference();
        assert_eq!(
            provider.resolve_member(&reference),
            Some(Member::Type(ty.clone())),
            "{reference}"
        );
        for member in ty.members() {
            let reference = member.code_reference();
            assert_eq!(
                provider.resolve_member(&reference).as_ref(),
                Some(&member),
                "{reference}"
            );
            checked += 1;
        }
    }
    assert!(checked > 20);
    Ok(())
}

#[test]
fn formatted_references() -> Result<()> {
    let (provider, _module) = registered()?;
    let c = ty(&provider, "Contoso.C");
    let deep = ty(&provider, "Contoso.Box`1+Inner`2+Deep");

    let references: Vec<String> = c.members().iter().map(Member::code_reference).collect();
    assert_eq!(
        references,
        [
            "M:Contoso.C.#ctor",
            "M:Contoso.C.#ctor(System.Int32)",
            "M:Contoso.C.Run(System.String)",
            "M:Contoso.C.Run(System.Int32,System.String[])",
            "P:Contoso.C.Name",
            "F:Contoso.C.Zero",
            "E:Contoso.C.Changed",
        ]
    );
    assert_eq!(deep.code_reference(), "T:Contoso.Box`1.Inner`2.Deep");
    assert_eq!(
        deep.method("Touch").unwrap().code_reference(),
        "M:Contoso.Box`1.Inner`2.Deep.Touch``1(`0,`2,``0)"
    );

    // generic parameters report their owner
    let w = deep.method("Touch").unwrap().generic_parameters()[0].clone();
    assert_eq!(
        Member::TypeParameter(w).code_reference(),
        "M:Contoso.Box`1.Inner`2.Deep.Touch``1(`0,`2,``0)"
    );

    // constructed types report their definition
    let int = ty(&provider, "System.Int32");
    let boxed = ty(&provider, "Contoso.Box`1").make_generic_type(&[int])?;
    assert_eq!(boxed.code_reference(), "T:Contoso.Box`1");
    assert_eq!(boxed.field("Value").unwrap().code_reference(), "F:Contoso.Box`1.Value");
    Ok(())
}

#[test]
fn constructor_by_parameter_list() -> Result<()> {
    let (provider, _module) = registered()?;

    let Some(Member::Constructor(ctor)) = provider.resolve_member("M:Contoso.C.#ctor(System.Int32)")
    else {
        panic!("constructor did not resolve");
    };
    let parameters = ctor.parameter_types();
    assert_eq!(parameters.len(), 1);
    assert!(parameters[0].is_primitive());
    assert_eq!(parameters[0].full_name(), "System.Int32");

    let Some(Member::Constructor(default)) = provider.resolve_member("M:Contoso.C.#ctor") else {
        panic!("default constructor did not resolve");
    };
    assert!(default.parameter_types().is_empty());
    Ok(())
}

/// Unresolvable and malformed references are absences, never errors.
#[test]
fn soft_failures() -> Result<()> {
    let (provider, _module) = registered()?;
    for reference in [
        "M:Contoso.C.NoSuchMethod",
        "M:Contoso.C.Run(System.Double)",
        "M:Contoso.C.#ctor(System.Int32,System.Int32)",
        "T:Contoso.Missing",
        "P:Contoso.C.Zero",
        "N:Contoso",
        "X:Contoso.C",
        "M:",
        "M:Contoso.C.Run(",
        "T:Contoso.Box``1",
    ] {
        assert!(provider.resolve_member(reference).is_none(), "{reference}");
    }
    Ok(())
}

#[test]
fn syntactic_checks() {
    assert!(CodeReference::is_valid("T:System.String"));
    assert!(CodeReference::is_valid("M:N.C.Method``1(``0[0:,0:],`1@)"));
    assert!(CodeReference::is_valid("N:System.Collections"));
    assert!(!CodeReference::is_valid("System.String"));
    assert!(!CodeReference::is_valid("Q:System.String"));
    assert!(!CodeReference::is_valid("M:N.C.Method(System.Int32"));

    assert!(CodeReference::is_namespace("N:System.Collections"));
    assert!(!CodeReference::is_namespace("T:System.Collections"));
    assert!(!CodeReference::is_namespace("N:"));

    let parsed: CodeReference = "M:N.C.op_Explicit(N.C)~System.Int32".parse().unwrap();
    assert_eq!(parsed.kind(), ReferenceKind::Method);
    assert_eq!(parsed.member_name(), Some("op_Explicit"));
    assert_eq!(parsed.return_type().unwrap().to_string(), "System.Int32");
    assert!(matches!(
        "".parse::<CodeReference>(),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn references_into_the_core_library() {
    let provider = MetadataProvider::new();
    assert!(matches!(
        provider.resolve_member("T:System.Object"),
        Some(Member::Type(_))
    ));
    assert!(matches!(
        provider.resolve_member("M:System.Object.Equals(System.Object)"),
        Some(Member::Method(_))
    ));
    assert!(provider.resolve_member("M:System.Object.Equals(System.String)").is_none());
}
