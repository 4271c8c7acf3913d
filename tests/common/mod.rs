//! Shared fixtures for the integration tests.
//!
//! `contoso()` builds a module that exercises most of the type graph: nested generics, a class
//! hierarchy with overrides, interfaces with variance and two extension containers.
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use dotdoc::prelude::*;

pub fn instance(definition: Token, arguments: Vec<TypeSignature>) -> TypeSignature {
    TypeSignature::GenericInst(Box::new(TypeSignature::Class(definition)), arguments)
}

/// Types of the `Contoso` module:
///
/// - `Contoso.C` with two constructors, `Run` overloads, a constant, a property and an event
/// - `Contoso.Box<T>` with `Box<T>.Inner<U, V>.Deep`
/// - `Contoso.Animal`, `Contoso.Dog : Animal, IPet`
/// - `Contoso.Base<T>`, `Contoso.Derived : Base<int>`
/// - `Contoso.IProducer<out T>`, `Contoso.IConsumer<in T>`, `Contoso.Holder<T>`
/// - `Contoso.FirstExtensions`, `Contoso.SecondExtensions`
pub fn contoso() -> Result<ModuleBuilder> {
    let mut module = ModuleBuilder::new("Contoso");
    let handler = module.core_type("System", "EventHandler")?;

    let c = TypeBuilder::class("Contoso", "C").build(&mut module)?;
    MethodBuilder::constructor().build(&mut module, c)?;
    MethodBuilder::constructor()
        .parameter(("value", TypeSignature::I4))
        .build(&mut module, c)?;
    MethodBuilder::new("Run")
        .parameter(("name", TypeSignature::String))
        .build(&mut module, c)?;
    MethodBuilder::new("Run")
        .parameter(("count", TypeSignature::I4))
        .parameter(("names", TypeSignature::SzArray(Box::new(TypeSignature::String))))
        .build(&mut module, c)?;
    FieldBuilder::new("Zero", TypeSignature::I4)
        .flags(FieldAttributes::PUBLIC | FieldAttributes::STATIC | FieldAttributes::LITERAL)
        .constant(ConstantValue::I4(0))
        .build(&mut module, c)?;
    let get_name = MethodBuilder::new("get_Name")
        .add_flags(MethodAttributes::SPECIAL_NAME)
        .returns(TypeSignature::String)
        .build(&mut module, c)?;
    let set_name = MethodBuilder::new("set_Name")
        .add_flags(MethodAttributes::SPECIAL_NAME)
        .parameter(("value", TypeSignature::String))
        .build(&mut module, c)?;
    PropertyBuilder::new("Name", TypeSignature::String)
        .getter(get_name)
        .setter(set_name)
        .build(&mut module, c)?;
    let add = MethodBuilder::new("add_Changed")
        .add_flags(MethodAttributes::SPECIAL_NAME)
        .parameter(("value", TypeSignature::Class(handler)))
        .build(&mut module, c)?;
    let remove = MethodBuilder::new("remove_Changed")
        .add_flags(MethodAttributes::SPECIAL_NAME)
        .parameter(("value", TypeSignature::Class(handler)))
        .build(&mut module, c)?;
    EventBuilder::new("Changed", TypeSignature::Class(handler))
        .adder(add)
        .remover(remove)
        .build(&mut module, c)?;

    let boxed = TypeBuilder::class("Contoso", "Box`1")
        .generic_parameter("T")
        .build(&mut module)?;
    FieldBuilder::new("Value", TypeSignature::GenericParamType(0)).build(&mut module, boxed)?;
    let inner = TypeBuilder::class("", "Inner`2")
        .nested_in(boxed)
        .generic_parameter("U")
        .generic_parameter("V")
        .build(&mut module)?;
    let deep = TypeBuilder::class("", "Deep")
        .nested_in(inner)
        .build(&mut module)?;
    MethodBuilder::new("Touch")
        .generic_parameter("W")
        .parameter(("first", TypeSignature::GenericParamType(0)))
        .parameter(("last", TypeSignature::GenericParamType(2)))
        .parameter(("own", TypeSignature::GenericParamMethod(0)))
        .build(&mut module, deep)?;

    let pet = TypeBuilder::interface("Contoso", "IPet").build(&mut module)?;
    let animal = TypeBuilder::class("Contoso", "Animal").build(&mut module)?;
    MethodBuilder::constructor().build(&mut module, animal)?;
    let dog = TypeBuilder::class("Contoso", "Dog")
        .extends(TypeSignature::Class(animal))
        .implements(TypeSignature::Class(pet))
        .build(&mut module)?;
    MethodBuilder::constructor().build(&mut module, dog)?;

    let base = TypeBuilder::class("Contoso", "Base`1")
        .generic_parameter("T")
        .build(&mut module)?;
    MethodBuilder::constructor().build(&mut module, base)?;
    MethodBuilder::new("Describe")
        .virtual_method()
        .returns(TypeSignature::String)
        .build(&mut module, base)?;
    MethodBuilder::new("Accept")
        .virtual_method()
        .parameter(("value", TypeSignature::GenericParamType(0)))
        .build(&mut module, base)?;
    let derived = TypeBuilder::class("Contoso", "Derived")
        .extends(instance(base, vec![TypeSignature::I4]))
        .build(&mut module)?;
    MethodBuilder::constructor().build(&mut module, derived)?;
    MethodBuilder::new("Describe")
        .override_method()
        .returns(TypeSignature::String)
        .build(&mut module, derived)?;
    MethodBuilder::new("Accept")
        .override_method()
        .parameter(("value", TypeSignature::I4))
        .build(&mut module, derived)?;
    MethodBuilder::new("Other").build(&mut module, derived)?;

    TypeBuilder::interface("Contoso", "IProducer`1")
        .generic_parameter(GenericParameterBuilder::new("T").covariant())
        .build(&mut module)?;
    TypeBuilder::interface("Contoso", "IConsumer`1")
        .generic_parameter(GenericParameterBuilder::new("T").contravariant())
        .build(&mut module)?;
    TypeBuilder::class("Contoso", "Holder`1")
        .generic_parameter("T")
        .build(&mut module)?;

    let statics = TypeAttributes::ABSTRACT | TypeAttributes::SEALED;
    let first = TypeBuilder::class("Contoso", "FirstExtensions")
        .add_flags(statics)
        .extension()
        .build(&mut module)?;
    MethodBuilder::new("Bark")
        .static_method()
        .extension()
        .parameter(("dog", TypeSignature::Class(dog)))
        .build(&mut module, first)?;
    MethodBuilder::new("Feed")
        .static_method()
        .extension()
        .parameter(("animal", TypeSignature::Class(animal)))
        .parameter(("portions", TypeSignature::I4))
        .build(&mut module, first)?;
    let second = TypeBuilder::class("Contoso", "SecondExtensions")
        .add_flags(statics)
        .extension()
        .build(&mut module)?;
    MethodBuilder::new("Bark")
        .static_method()
        .extension()
        .parameter(("animal", TypeSignature::Class(animal)))
        .build(&mut module, second)?;

    Ok(module)
}

/// `contoso()` built and registered with a fresh provider
pub fn registered() -> Result<(MetadataProvider, ModuleRc)> {
    let module = contoso()?.build()?;
    let provider = MetadataProvider::new();
    provider.register_module(&module);
    Ok((provider, module))
}

/// Looks up a type that the fixture is known to define
pub fn ty(provider: &MetadataProvider, full_name: &str) -> TypeRc {
    provider
        .find_type_by_full_name(full_name)
        .unwrap_or_else(|| panic!("{full_name} is not defined"))
}

/// Writes a module with a single `<assembly>.Widget` class to `directory/file`
pub fn write_widget(directory: &Path, file: &str, assembly: &str) -> Result<PathBuf> {
    let mut module = ModuleBuilder::new(assembly);
    TypeBuilder::class(assembly, "Widget").build(&mut module)?;
    let path = directory.join(file);
    module.write_to(&path)?;
    Ok(path)
}
