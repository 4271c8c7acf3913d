//! Code references of metadata objects.
//!
//! Members of constructed types and constructed generic methods report the reference of their
//! definition, so every instantiation of a member shares one reference.

use std::{fmt::Write, sync::Arc};

use crate::metadata::{
    coderef::parser::{write_list, Segment, TypeName},
    handle::{GenericOwner, MemberHandle, MethodHandle, TypeHandle},
    module::{Module, ModuleRc},
    provider::ProviderInner,
    tables::TableId,
    token::Token,
    typesystem::{Event, Field, Method, Property, Type, TypeKind, MAX_CHAIN_DEPTH},
};

/// Encodes a member name for the reference head: explicit implementation names lose their dots
/// and angle brackets (`N.IFoo<T>.Bar` → `N#IFoo#T##Bar`), constructors become `#ctor`.
pub(crate) fn encode_member_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '.' | '<' | '>' => '#',
            ',' => '@',
            other => other,
        })
        .collect()
}

fn type_token(row: u32) -> Token {
    Token::from_parts(TableId::TypeDef, row)
}

/// ``Namespace.Outer`1.Inner``, the head of references into TypeDef `row`
fn definition_path(module: &Module, row: u32) -> String {
    module.type_full_name(row).replace('+', ".")
}

/// Strips the arity suffix from a generic type name
fn without_arity(name: &str) -> &str {
    match name.rsplit_once('`') {
        Some((stem, arity)) if !arity.is_empty() && arity.chars().all(|c| c.is_ascii_digit()) => {
            stem
        }
        _ => name,
    }
}

/// The segments of TypeDef `row` instantiated over `arguments`, which cover the full
/// parameter list including those redeclared from enclosing types
fn nested_segments(module: &Module, row: u32, arguments: &[TypeName]) -> Option<Vec<Segment>> {
    let mut chain = vec![row];
    while let Some(enclosing) = module.enclosing_type(chain[chain.len() - 1]) {
        if chain.len() > MAX_CHAIN_DEPTH {
            return None;
        }
        chain.push(enclosing);
    }
    chain.reverse();

    let outermost = module.type_def(chain[0])?;
    let mut segments: Vec<Segment> = outermost
        .namespace
        .split('.')
        .filter(|part| !part.is_empty())
        .map(Segment::plain)
        .collect();

    let mut declared = 0;
    for level in chain {
        let def = module.type_def(level)?;
        let count = module.generic_params(type_token(level)).len().max(declared);
        let own = arguments.get(declared..count)?;
        declared = count;
        segments.push(if own.is_empty() {
            Segment::plain(def.name.clone())
        } else {
            Segment {
                name: without_arity(&def.name).to_string(),
                arguments: own.to_vec(),
            }
        });
    }
    Some(segments)
}

/// The parameter-list form of `handle`.
///
/// Generic definitions are written over their own parameters (``List{`0}``), function pointers
/// as `System.IntPtr`.
pub(crate) fn type_name(provider: &Arc<ProviderInner>, handle: &TypeHandle) -> Option<TypeName> {
    Some(match handle {
        TypeHandle::Definition { module, row } => {
            let module = provider.module(*module).ok()?;
            let count = module.generic_params(type_token(*row)).len();
            let own: Vec<TypeName> = (0..count)
                .map(|number| TypeName::TypeParameter(u32::try_from(number).unwrap_or(u32::MAX)))
                .collect();
            TypeName::Named(nested_segments(&module, *row, &own)?)
        }
        TypeHandle::Instance {
            definition,
            arguments,
        } => {
            let TypeHandle::Definition { module, row } = definition.as_ref() else {
                return None;
            };
            let module = provider.module(*module).ok()?;
            let arguments = arguments
                .iter()
                .map(|argument| type_name(provider, argument))
                .collect::<Option<Vec<_>>>()?;
            TypeName::Named(nested_segments(&module, *row, &arguments)?)
        }
        TypeHandle::Named { full_name, .. } => {
            TypeName::Named(full_name.split(['.', '+']).map(Segment::plain).collect())
        }
        TypeHandle::Reference { .. } => match provider.canonical_type(handle) {
            TypeHandle::Reference { .. } => return None,
            canonical => return type_name(provider, &canonical),
        },
        TypeHandle::Parameter { owner, number } => match owner {
            GenericOwner::Type { .. } => TypeName::TypeParameter(*number),
            GenericOwner::Method { .. } => TypeName::MethodParameter(*number),
        },
        TypeHandle::Array { element, rank } => TypeName::Array(
            Box::new(type_name(provider, element)?),
            if *rank <= 1 { 0 } else { *rank },
        ),
        TypeHandle::Pointer(element) => TypeName::Pointer(Box::new(type_name(provider, element)?)),
        TypeHandle::ByRef(element) => TypeName::ByRef(Box::new(type_name(provider, element)?)),
        TypeHandle::FunctionPointer => {
            TypeName::Named(vec![Segment::plain("System"), Segment::plain("IntPtr")])
        }
        TypeHandle::TypedReference => TypeName::Named(vec![
            Segment::plain("System"),
            Segment::plain("TypedReference"),
        ]),
    })
}

/// Parameter-list forms of `handles`; `None` if any of them has no form
pub(crate) fn type_names(
    provider: &Arc<ProviderInner>,
    handles: &[TypeHandle],
) -> Option<Vec<TypeName>> {
    handles
        .iter()
        .map(|handle| type_name(provider, handle))
        .collect()
}

fn write_parameters(reference: &mut String, parameters: &[TypeName]) {
    if parameters.is_empty() {
        return;
    }
    reference.push('(');
    let _ = write_list(reference, parameters);
    reference.push(')');
}

/// `T:` reference of a type. Constructed types report their definition, generic parameters
/// their owner and decorators the parameter-list form of the whole type.
pub(crate) fn type_reference(provider: &Arc<ProviderInner>, ty: &Type) -> String {
    match ty.handle() {
        TypeHandle::Definition { module, row } => match provider.module(*module) {
            Ok(module) => format!("T:{}", definition_path(&module, *row)),
            Err(_) => format!("T:{}", ty.name()),
        },
        TypeHandle::Instance { definition, .. } => match provider.get_type(definition) {
            Ok(definition) => type_reference(provider, &definition),
            Err(_) => format!("T:{}", ty.name()),
        },
        TypeHandle::Named { full_name, .. } => format!("T:{}", full_name.replace('+', ".")),
        TypeHandle::Parameter { .. } if ty.kind() == TypeKind::GenericParameter => {
            match ty.declaring_method() {
                Some(method) => method_reference(&method),
                None => ty
                    .declaring_type()
                    .map(|owner| owner.code_reference())
                    .unwrap_or_default(),
            }
        }
        handle => match type_name(provider, handle) {
            Some(name) => format!("T:{name}"),
            None => format!("T:{}", ty.name()),
        },
    }
}

/// Head of a member reference: kind, declaring definition path and encoded name
fn member_head(kind: char, module: &ModuleRc, declaring: &TypeHandle, name: &str) -> String {
    let row = match declaring {
        TypeHandle::Instance { definition, .. } => match definition.as_ref() {
            TypeHandle::Definition { row, .. } => *row,
            _ => 0,
        },
        TypeHandle::Definition { row, .. } => *row,
        _ => 0,
    };
    format!(
        "{kind}:{}.{}",
        definition_path(module, row),
        encode_member_name(name)
    )
}

fn is_conversion(name: &str) -> bool {
    matches!(name, "op_Implicit" | "op_Explicit")
}

/// `M:` reference of a method, constructor or operator
pub(crate) fn method_reference(method: &Method) -> String {
    let (Some(provider), Some(module)) = (method.inner(), method.module()) else {
        return format!("M:{}", encode_member_name(method.name()));
    };
    let handle = method.handle();
    let is_definition =
        matches!(handle.declaring, TypeHandle::Definition { .. }) && handle.arguments.is_empty();
    let definition = if is_definition {
        None
    } else {
        provider
            .get_method(&MethodHandle {
                declaring: TypeHandle::definition(handle.module, method.declaring_row()),
                module: handle.module,
                row: handle.row,
                arguments: Vec::new(),
            })
            .ok()
    };
    let method = definition.as_deref().unwrap_or(method);

    let mut reference = member_head(
        'M',
        &module,
        &TypeHandle::definition(handle.module, method.declaring_row()),
        method.name(),
    );
    if method.generic_count() > 0 {
        let _ = write!(reference, "``{}", method.generic_count());
    }
    let parameters =
        type_names(&provider, method.parameter_type_handles()).unwrap_or_default();
    write_parameters(&mut reference, &parameters);
    if is_conversion(method.name()) {
        if let Some(return_type) = type_name(&provider, method.return_type_handle()) {
            let _ = write!(reference, "~{return_type}");
        }
    }
    reference
}

fn definition_handle(handle: &MemberHandle) -> MemberHandle {
    match &handle.declaring {
        TypeHandle::Instance { definition, .. } => MemberHandle {
            declaring: definition.as_ref().clone(),
            ..handle.clone()
        },
        _ => handle.clone(),
    }
}

/// `F:` reference of a field
pub(crate) fn field_reference(field: &Field) -> String {
    match field.module() {
        Some(module) => member_head('F', &module, &field.handle().declaring, field.name()),
        None => format!("F:{}", encode_member_name(field.name())),
    }
}

/// `P:` reference of a property, with the index parameters of indexers
pub(crate) fn property_reference(property: &Property) -> String {
    let (Some(provider), Some(module)) = (property.inner(), property.module()) else {
        return format!("P:{}", encode_member_name(property.name()));
    };
    let handle = property.handle();
    let definition = matches!(handle.declaring, TypeHandle::Instance { .. })
        .then(|| provider.get_property(&definition_handle(handle)).ok())
        .flatten();
    let property = definition.as_deref().unwrap_or(property);

    let mut reference = member_head('P', &module, &handle.declaring, property.name());
    let parameters =
        type_names(&provider, property.index_type_handles()).unwrap_or_default();
    write_parameters(&mut reference, &parameters);
    reference
}

/// `E:` reference of an event
pub(crate) fn event_reference(event: &Event) -> String {
    match event.module() {
        Some(module) => member_head('E', &module, &event.handle().declaring, event.name()),
        None => format!("E:{}", encode_member_name(event.name())),
    }
}
