//! The core runtime library.
//!
//! Modules reference their fundamental types (`System.Object`, the primitives, `Nullable<T>`, ...)
//! through an assembly such as `System.Runtime` that is normally not part of the inspected set.
//! This module synthesizes a small `System.Private.CoreLib` holding those types so that base
//! type chains, primitive classification and variance always have something to bind to.

use std::sync::OnceLock;

use crate::{
    metadata::{
        builder::{
            GenericParameterBuilder, MethodBuilder, ModuleBuilder, PropertyBuilder, TypeBuilder,
            CORE_LIBRARY,
        },
        flags::{GenericParamAttributes, MethodAttributes, TypeAttributes},
        module::ModuleRc,
        signatures::TypeSignature,
        token::Token,
    },
    Result,
};

/// Assembly names that bind to the core library when no registered module supplies a type
pub const CORE_ASSEMBLIES: [&str; 4] = ["mscorlib", "netstandard", "System.Runtime", CORE_LIBRARY];

/// Names of the `System` value types that classify as primitives
pub const PRIMITIVE_TYPES: [&str; 14] = [
    "Boolean", "Char", "SByte", "Byte", "Int16", "UInt16", "Int32", "UInt32", "Int64", "UInt64",
    "Single", "Double", "IntPtr", "UIntPtr",
];

static CORE: OnceLock<ModuleRc> = OnceLock::new();

/// Returns true if references to `assembly` bind to the core library.
#[must_use]
pub fn is_core_assembly(assembly: &str) -> bool {
    CORE_ASSEMBLIES
        .iter()
        .any(|core| core.eq_ignore_ascii_case(assembly))
}

/// The process-wide core library module.
///
/// # Errors
/// Only fails if the synthesized tables are rejected by the module loader.
pub fn core_library() -> Result<ModuleRc> {
    if let Some(module) = CORE.get() {
        return Ok(module.clone());
    }
    let module = build()?;
    Ok(CORE.get_or_init(|| module).clone())
}

fn instantiate(definition: Token, argument: TypeSignature) -> TypeSignature {
    TypeSignature::GenericInst(Box::new(TypeSignature::Class(definition)), vec![argument])
}

fn constructor(module: &mut ModuleBuilder, owner: Token) -> Result<()> {
    MethodBuilder::constructor().build(module, owner)?;
    Ok(())
}

#[allow(clippy::too_many_lines)]
fn build() -> Result<ModuleRc> {
    let mut core = ModuleBuilder::new(CORE_LIBRARY);

    let object = TypeBuilder::class("System", "Object")
        .add_flags(TypeAttributes::SERIALIZABLE)
        .without_base()
        .build(&mut core)?;
    constructor(&mut core, object)?;
    MethodBuilder::new("ToString")
        .virtual_method()
        .returns(TypeSignature::String)
        .build(&mut core, object)?;
    MethodBuilder::new("Equals")
        .virtual_method()
        .returns(TypeSignature::Boolean)
        .parameter(("obj", TypeSignature::Object))
        .build(&mut core, object)?;
    MethodBuilder::new("GetHashCode")
        .virtual_method()
        .returns(TypeSignature::I4)
        .build(&mut core, object)?;

    let value_type = TypeBuilder::class("System", "ValueType")
        .add_flags(TypeAttributes::ABSTRACT | TypeAttributes::SERIALIZABLE)
        .build(&mut core)?;
    TypeBuilder::class("System", "Enum")
        .add_flags(TypeAttributes::ABSTRACT | TypeAttributes::SERIALIZABLE)
        .extends(TypeSignature::Class(value_type))
        .build(&mut core)?;
    let delegate = TypeBuilder::class("System", "Delegate")
        .add_flags(TypeAttributes::ABSTRACT)
        .build(&mut core)?;
    TypeBuilder::class("System", "MulticastDelegate")
        .add_flags(TypeAttributes::ABSTRACT)
        .extends(TypeSignature::Class(delegate))
        .build(&mut core)?;

    let comparable = TypeBuilder::interface("System", "IComparable`1")
        .generic_parameter(GenericParameterBuilder::new("T").contravariant())
        .build(&mut core)?;
    MethodBuilder::new("CompareTo")
        .abstract_method()
        .returns(TypeSignature::I4)
        .parameter(("other", TypeSignature::GenericParamType(0)))
        .build(&mut core, comparable)?;

    let disposable = TypeBuilder::interface("System", "IDisposable").build(&mut core)?;
    MethodBuilder::new("Dispose")
        .abstract_method()
        .build(&mut core, disposable)?;

    let enumerable =
        TypeBuilder::interface("System.Collections", "IEnumerable").build(&mut core)?;
    let enumerable_of = TypeBuilder::interface("System.Collections.Generic", "IEnumerable`1")
        .generic_parameter(GenericParameterBuilder::new("T").covariant())
        .implements(TypeSignature::Class(enumerable))
        .build(&mut core)?;

    TypeBuilder::class("System", "Array")
        .add_flags(TypeAttributes::ABSTRACT | TypeAttributes::SERIALIZABLE)
        .implements(TypeSignature::Class(enumerable))
        .build(&mut core)?;

    for name in PRIMITIVE_TYPES {
        let primitive = TypeBuilder::value_type("System", name).build(&mut core)?;
        if !matches!(name, "IntPtr" | "UIntPtr") {
            let comparable_self = instantiate(comparable, TypeSignature::ValueType(primitive));
            core.add_interface(primitive, &comparable_self)?;
        }
    }
    for name in ["Void", "Decimal", "TypedReference"] {
        TypeBuilder::value_type("System", name).build(&mut core)?;
    }

    let string = TypeBuilder::class("System", "String")
        .add_flags(TypeAttributes::SEALED | TypeAttributes::SERIALIZABLE)
        .implements(instantiate(comparable, TypeSignature::String))
        .implements(instantiate(enumerable_of, TypeSignature::Char))
        .build(&mut core)?;
    let length = MethodBuilder::new("get_Length")
        .add_flags(MethodAttributes::SPECIAL_NAME)
        .returns(TypeSignature::I4)
        .build(&mut core, string)?;
    PropertyBuilder::new("Length", TypeSignature::I4)
        .getter(length)
        .build(&mut core, string)?;

    let nullable = TypeBuilder::value_type("System", "Nullable`1")
        .generic_parameter(
            GenericParameterBuilder::new("T")
                .flags(
                    GenericParamAttributes::NOT_NULLABLE_VALUE_TYPE_CONSTRAINT
                        | GenericParamAttributes::DEFAULT_CONSTRUCTOR_CONSTRAINT,
                )
                .constraint(TypeSignature::Class(value_type)),
        )
        .build(&mut core)?;
    MethodBuilder::constructor()
        .parameter(("value", TypeSignature::GenericParamType(0)))
        .build(&mut core, nullable)?;
    let has_value = MethodBuilder::new("get_HasValue")
        .add_flags(MethodAttributes::SPECIAL_NAME)
        .returns(TypeSignature::Boolean)
        .build(&mut core, nullable)?;
    PropertyBuilder::new("HasValue", TypeSignature::Boolean)
        .getter(has_value)
        .build(&mut core, nullable)?;
    let value = MethodBuilder::new("get_Value")
        .add_flags(MethodAttributes::SPECIAL_NAME)
        .returns(TypeSignature::GenericParamType(0))
        .build(&mut core, nullable)?;
    PropertyBuilder::new("Value", TypeSignature::GenericParamType(0))
        .getter(value)
        .build(&mut core, nullable)?;

    let event_args = TypeBuilder::class("System", "EventArgs").build(&mut core)?;
    constructor(&mut core, event_args)?;
    let handler = TypeBuilder::delegate("System", "EventHandler").build(&mut core)?;
    MethodBuilder::constructor()
        .parameter(("object", TypeSignature::Object))
        .parameter(("method", TypeSignature::I))
        .build(&mut core, handler)?;
    MethodBuilder::new("Invoke")
        .virtual_method()
        .parameter(("sender", TypeSignature::Object))
        .parameter(("e", TypeSignature::Class(event_args)))
        .build(&mut core, handler)?;

    let attribute = TypeBuilder::class("System", "Attribute")
        .add_flags(TypeAttributes::ABSTRACT | TypeAttributes::SERIALIZABLE)
        .build(&mut core)?;
    let markers = [
        ("System", "ParamArrayAttribute"),
        ("System.Runtime.CompilerServices", "ExtensionAttribute"),
        ("System.Runtime.CompilerServices", "IsReadOnlyAttribute"),
        ("System.Runtime.CompilerServices", "IsByRefLikeAttribute"),
    ];
    for (namespace, name) in markers {
        let marker = TypeBuilder::class(namespace, name)
            .add_flags(TypeAttributes::SEALED)
            .extends(TypeSignature::Class(attribute))
            .build(&mut core)?;
        constructor(&mut core, marker)?;
    }

    core.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_instance() {
        let first = core_library().unwrap();
        let second = core_library().unwrap();
        assert_eq!(first.id(), second.id());
        assert_eq!(first.assembly_name(), CORE_LIBRARY);
    }

    #[test]
    fn fundamental_types() {
        let core = core_library().unwrap();
        for name in PRIMITIVE_TYPES {
            assert!(core.find_type("System", name).is_some(), "{name}");
        }
        for full_name in [
            "System.Object",
            "System.String",
            "System.Nullable`1",
            "System.Collections.Generic.IEnumerable`1",
            "System.Runtime.CompilerServices.ExtensionAttribute",
        ] {
            assert!(core.find_type_by_full_name(full_name).is_some(), "{full_name}");
        }

        let object = core.find_type("System", "Object").unwrap();
        assert!(core.type_def(object).unwrap().extends.is_null());
    }

    #[test]
    fn core_assembly_names() {
        assert!(is_core_assembly("mscorlib"));
        assert!(is_core_assembly("System.Runtime"));
        assert!(is_core_assembly("NETStandard"));
        assert!(!is_core_assembly("System.Linq"));
    }
}
