//! Programmatic construction of modules.
//!
//! [`ModuleBuilder`] collects type definitions and their members through small fluent builders
//! ([`TypeBuilder`], [`MethodBuilder`], [`FieldBuilder`], [`PropertyBuilder`], [`EventBuilder`])
//! and lays them out into the same [`MetadataTables`] the reader produces. A built module can be
//! handed to the model directly ([`ModuleBuilder::build`]) or serialised into a metadata image
//! ([`ModuleBuilder::to_bytes`], [`ModuleBuilder::write_to`]) and loaded back from disk.
//!
//! Type definitions receive their token as soon as they are built. Members are laid out by owner
//! when the tables are produced, so methods are identified by a [`MethodId`] until then.
//!
//! # Example
//!
//! ```rust
//! use dotdoc::metadata::{
//!     builder::{MethodBuilder, ModuleBuilder, TypeBuilder},
//!     signatures::TypeSignature,
//! };
//!
//! let mut module = ModuleBuilder::new("Geometry");
//! let shape = TypeBuilder::class("Geometry", "Shape").build(&mut module)?;
//! MethodBuilder::new("Area")
//!     .returns(TypeSignature::R8)
//!     .build(&mut module, shape)?;
//!
//! let module = module.build()?;
//! assert!(module.find_type("Geometry", "Shape").is_some());
//! # Ok::<(), dotdoc::Error>(())
//! ```

use std::{
    collections::{hash_map::DefaultHasher, HashMap},
    hash::{Hash, Hasher},
    path::Path,
};

use crate::{
    metadata::{
        constant::ConstantValue,
        flags::{
            EventAttributes, FieldAttributes, GenericParamAttributes, MethodAttributes,
            MethodSemanticsAttributes, ParamAttributes, PropertyAttributes, TypeAttributes,
            TYPE_VISIBILITY_MASK,
        },
        module::{Module, ModuleRc},
        root::DEFAULT_VERSION,
        signatures::{
            encode_field_signature, encode_method_signature, encode_property_signature,
            encode_typespec_signature, SignatureField, SignatureMethod, SignatureParameter,
            SignatureProperty, TypeSignature,
        },
        tables::{
            writer::write_metadata, AssemblyRefRow, AssemblyRow, CodedIndexType, ConstantRow,
            CustomAttributeRow, EventMapRow, EventRow, FieldRow, GenericParamConstraintRow,
            GenericParamRow, InterfaceImplRow, MemberRefRow, MetadataTables, MethodDefRow,
            MethodImplRow, MethodSemanticsRow, ModuleRow, NestedClassRow, ParamRow,
            PropertyMapRow, PropertyRow, TableId, TypeDefRow, TypeRefRow, TypeSpecRow,
        },
        token::Token,
    },
    Error, Result,
};

/// Assembly name of the core runtime library
pub const CORE_LIBRARY: &str = "System.Private.CoreLib";

/// Assembly that non-core modules reference core types through
pub const CORE_REFERENCE: &str = "System.Runtime";

/// Custom attribute blob without arguments: the prolog and zero named arguments
const EMPTY_ATTRIBUTE: [u8; 4] = [0x01, 0x00, 0x00, 0x00];

/// Identifies a method of a [`ModuleBuilder`] before its row number is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodId(usize);

/// A method an implementation binds to: one of this builder's methods or a `MemberRef`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodTarget {
    /// A method defined by the same builder
    Local(MethodId),
    /// A `MethodDef` or `MemberRef` token
    Token(Token),
}

impl From<MethodId> for MethodTarget {
    fn from(id: MethodId) -> Self {
        MethodTarget::Local(id)
    }
}

impl From<Token> for MethodTarget {
    fn from(token: Token) -> Self {
        MethodTarget::Token(token)
    }
}

#[derive(Clone)]
struct GenericParamEntry {
    name: String,
    flags: GenericParamAttributes,
    constraints: Vec<Token>,
}

struct TypeEntry {
    flags: TypeAttributes,
    name: String,
    namespace: String,
    extends: Token,
    enclosing: Option<u32>,
    interfaces: Vec<Token>,
    generic_params: Vec<GenericParamEntry>,
    attributes: Vec<Token>,
}

struct ParamEntry {
    name: String,
    flags: ParamAttributes,
    default: Option<ConstantValue>,
    attributes: Vec<Token>,
}

struct MethodEntry {
    owner: u32,
    flags: MethodAttributes,
    name: String,
    signature: Vec<u8>,
    params: Vec<ParamEntry>,
    generic_params: Vec<GenericParamEntry>,
    implements: Vec<MethodTarget>,
    attributes: Vec<Token>,
}

struct FieldEntry {
    owner: u32,
    flags: FieldAttributes,
    name: String,
    signature: Vec<u8>,
    constant: Option<ConstantValue>,
}

struct PropertyEntry {
    owner: u32,
    flags: PropertyAttributes,
    name: String,
    signature: Vec<u8>,
    getter: Option<MethodId>,
    setter: Option<MethodId>,
}

struct EventEntry {
    owner: u32,
    flags: EventAttributes,
    name: String,
    event_type: Token,
    adder: Option<MethodId>,
    remover: Option<MethodId>,
    raiser: Option<MethodId>,
}

/// Collects the definitions of one module.
pub struct ModuleBuilder {
    name: String,
    types: Vec<TypeEntry>,
    methods: Vec<MethodEntry>,
    fields: Vec<FieldEntry>,
    properties: Vec<PropertyEntry>,
    events: Vec<EventEntry>,
    assembly_refs: Vec<AssemblyRefRow>,
    type_refs: Vec<TypeRefRow>,
    type_specs: Vec<Vec<u8>>,
    member_refs: Vec<MemberRefRow>,
}

/// Sort key of a coded index column: row first, then tag, which orders rows the way the encoded
/// values would.
fn coded_key(token: Token, kind: CodedIndexType) -> (u32, usize) {
    let tag = kind
        .tables()
        .iter()
        .position(|table| table.is_some_and(|table| token.is_table(table)))
        .unwrap_or(usize::MAX);
    (token.row(), tag)
}

fn mvid(name: &str) -> uguid::Guid {
    let mut bytes = [0_u8; 16];
    for (salt, chunk) in bytes.chunks_mut(8).enumerate() {
        let mut hasher = DefaultHasher::new();
        salt.hash(&mut hasher);
        name.hash(&mut hasher);
        chunk.copy_from_slice(&hasher.finish().to_le_bytes());
    }
    uguid::Guid::from_bytes(bytes)
}

#[allow(clippy::cast_possible_truncation)]
fn next_row(len: usize) -> u32 {
    len as u32 + 1
}

impl ModuleBuilder {
    /// Creates an empty module of the assembly `name`. The module file is `name.dll`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        ModuleBuilder {
            name: name.into(),
            types: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
            properties: Vec::new(),
            events: Vec::new(),
            assembly_refs: Vec::new(),
            type_refs: Vec::new(),
            type_specs: Vec::new(),
            member_refs: Vec::new(),
        }
    }

    /// Returns true if this builder produces the core runtime library itself
    #[must_use]
    pub fn is_core_library(&self) -> bool {
        self.name == CORE_LIBRARY
    }

    fn assembly_ref(&mut self, assembly: &str) -> Token {
        let position = self
            .assembly_refs
            .iter()
            .position(|row| row.name == assembly)
            .unwrap_or_else(|| {
                self.assembly_refs.push(AssemblyRefRow {
                    version: [4, 0, 0, 0],
                    flags: 0,
                    public_key_or_token: Vec::new(),
                    name: assembly.to_string(),
                    culture: String::new(),
                    hash_value: Vec::new(),
                });
                self.assembly_refs.len() - 1
            });
        Token::from_parts(TableId::AssemblyRef, next_row(position))
    }

    fn scoped_type_ref(&mut self, scope: Token, namespace: &str, name: &str) -> Token {
        let position = self
            .type_refs
            .iter()
            .position(|row| {
                row.resolution_scope == scope && row.namespace == namespace && row.name == name
            })
            .unwrap_or_else(|| {
                self.type_refs.push(TypeRefRow {
                    resolution_scope: scope,
                    name: name.to_string(),
                    namespace: namespace.to_string(),
                });
                self.type_refs.len() - 1
            });
        Token::from_parts(TableId::TypeRef, next_row(position))
    }

    /// Returns a `TypeRef` to `namespace.name` in the assembly `assembly`.
    pub fn type_ref(&mut self, assembly: &str, namespace: &str, name: &str) -> Token {
        let scope = self.assembly_ref(assembly);
        self.scoped_type_ref(scope, namespace, name)
    }

    /// Returns a `TypeRef` to the type `name` nested in the referenced type `enclosing`.
    pub fn nested_type_ref(&mut self, enclosing: Token, name: &str) -> Token {
        self.scoped_type_ref(enclosing, "", name)
    }

    /// Returns the token of a core library type.
    ///
    /// The core library itself resolves to its own definition, which has to be built first;
    /// every other module references the type through [`CORE_REFERENCE`].
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidArgument`] if the core library does not define the type yet.
    pub fn core_type(&mut self, namespace: &str, name: &str) -> Result<Token> {
        if !self.is_core_library() {
            return Ok(self.type_ref(CORE_REFERENCE, namespace, name));
        }

        self.types
            .iter()
            .position(|entry| {
                entry.enclosing.is_none() && entry.namespace == namespace && entry.name == name
            })
            .map(|position| Token::from_parts(TableId::TypeDef, next_row(position)))
            .ok_or_else(|| {
                Error::InvalidArgument(format!("core type {namespace}.{name} is not defined yet"))
            })
    }

    /// Returns a `TypeSpec` token for `signature`, reusing an identical one.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the signature can not be encoded.
    pub fn type_spec(&mut self, signature: &TypeSignature) -> Result<Token> {
        let blob = encode_typespec_signature(signature)?;
        let position = match self.type_specs.iter().position(|spec| *spec == blob) {
            Some(position) => position,
            None => {
                self.type_specs.push(blob);
                self.type_specs.len() - 1
            }
        };
        Ok(Token::from_parts(TableId::TypeSpec, next_row(position)))
    }

    /// Returns a `TypeDefOrRef` token for `signature`: the token itself for classes and value
    /// types, a core `TypeRef` for built-in types and a `TypeSpec` for everything else.
    ///
    /// # Errors
    /// Returns the errors of [`ModuleBuilder::core_type`] and [`ModuleBuilder::type_spec`].
    pub fn type_token(&mut self, signature: &TypeSignature) -> Result<Token> {
        match signature {
            TypeSignature::Class(token) | TypeSignature::ValueType(token) => Ok(*token),
            other => match other.primitive_name() {
                Some(name) => self.core_type("System", name),
                None => self.type_spec(other),
            },
        }
    }

    /// Returns a `MemberRef` to the method `name` of `parent`.
    ///
    /// # Errors
    /// Returns the errors of [`ModuleBuilder::type_token`] and signature encoding.
    pub fn method_ref(
        &mut self,
        parent: &TypeSignature,
        name: &str,
        signature: &SignatureMethod,
    ) -> Result<Token> {
        let class = self.type_token(parent)?;
        let signature = encode_method_signature(signature)?;
        let position = match self.member_refs.iter().position(|row| {
            row.class == class && row.name == name && row.signature == signature
        }) {
            Some(position) => position,
            None => {
                self.member_refs.push(MemberRefRow {
                    class,
                    name: name.to_string(),
                    signature,
                });
                self.member_refs.len() - 1
            }
        };
        Ok(Token::from_parts(TableId::MemberRef, next_row(position)))
    }

    /// Adds an interface implementation to the already built type `owner`, for interfaces that
    /// refer back to the type itself (`struct Int32 : IComparable<Int32>`).
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidArgument`] if `owner` is not a type of this module.
    pub fn add_interface(&mut self, owner: Token, interface: &TypeSignature) -> Result<()> {
        let row = self.owner_row(owner)?;
        let interface = self.type_token(interface)?;
        self.types[row as usize - 1].interfaces.push(interface);
        Ok(())
    }

    fn attribute_ctor(&mut self, attribute_type: Token) -> Result<Token> {
        let signature = SignatureMethod {
            has_this: true,
            ..SignatureMethod::default()
        };
        self.method_ref(&TypeSignature::Class(attribute_type), ".ctor", &signature)
    }

    fn attribute_types(&mut self, names: &[(String, String)]) -> Result<Vec<Token>> {
        names
            .iter()
            .map(|(namespace, name)| self.core_type(namespace, name))
            .collect()
    }

    fn owner_row(&self, owner: Token) -> Result<u32> {
        if owner.is_table(TableId::TypeDef) && owner.row() as usize <= self.types.len() {
            Ok(owner.row())
        } else {
            Err(Error::InvalidArgument(format!(
                "{owner} is not a type of this module"
            )))
        }
    }

    fn generic_params(
        &mut self,
        params: Vec<GenericParameterBuilder>,
    ) -> Result<Vec<GenericParamEntry>> {
        params
            .into_iter()
            .map(|param| {
                let constraints = param
                    .constraints
                    .iter()
                    .map(|constraint| self.type_token(constraint))
                    .collect::<Result<Vec<_>>>()?;
                Ok(GenericParamEntry {
                    name: param.name,
                    flags: param.flags,
                    constraints,
                })
            })
            .collect()
    }

    /// Lays the collected definitions out into tables.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidArgument`] if an accessor or implementation refers to a
    /// method that does not exist.
    #[allow(clippy::too_many_lines)]
    pub fn tables(&self) -> Result<MetadataTables> {
        let mut tables = MetadataTables::default();
        let mut member_refs = self.member_refs.clone();

        tables.module.push(ModuleRow {
            generation: 0,
            name: format!("{}.dll", self.name),
            mvid: mvid(&self.name),
        });
        tables.assembly.push(AssemblyRow {
            hash_alg_id: 0x8004,
            version: [1, 0, 0, 0],
            flags: 0,
            public_key: Vec::new(),
            name: self.name.clone(),
            culture: String::new(),
        });
        tables.assembly_ref.clone_from(&self.assembly_refs);
        tables.type_ref.clone_from(&self.type_refs);
        tables.type_spec = self
            .type_specs
            .iter()
            .map(|signature| TypeSpecRow {
                signature: signature.clone(),
            })
            .collect();

        // Members are stored grouped by owner; the sorts are stable so declaration order stays
        let mut method_order: Vec<usize> = (0..self.methods.len()).collect();
        method_order.sort_by_key(|index| self.methods[*index].owner);
        let mut method_rows = vec![0_u32; self.methods.len()];
        for (position, index) in method_order.iter().enumerate() {
            method_rows[*index] = next_row(position);
        }
        let method_token = |id: MethodId| -> Result<Token> {
            method_rows
                .get(id.0)
                .map(|row| Token::from_parts(TableId::MethodDef, *row))
                .ok_or_else(|| Error::InvalidArgument(format!("unknown method {id:?}")))
        };

        let mut field_order: Vec<usize> = (0..self.fields.len()).collect();
        field_order.sort_by_key(|index| self.fields[*index].owner);
        let field_owners: Vec<u32> = field_order.iter().map(|i| self.fields[*i].owner).collect();
        let method_owners: Vec<u32> = method_order.iter().map(|i| self.methods[*i].owner).collect();

        let mut attributes: Vec<(Token, Token)> = Vec::new();
        let mut generic_params: Vec<(Token, u16, &GenericParamEntry)> = Vec::new();

        for (index, entry) in self.types.iter().enumerate() {
            let type_row = next_row(index);
            let token = Token::from_parts(TableId::TypeDef, type_row);

            tables.type_def.push(TypeDefRow {
                flags: entry.flags,
                name: entry.name.clone(),
                namespace: entry.namespace.clone(),
                extends: entry.extends,
                field_list: next_row(field_owners.partition_point(|owner| *owner < type_row)),
                method_list: next_row(method_owners.partition_point(|owner| *owner < type_row)),
            });

            for interface in &entry.interfaces {
                tables.interface_impl.push(InterfaceImplRow {
                    class: type_row,
                    interface: *interface,
                });
            }
            if let Some(enclosing) = entry.enclosing {
                tables.nested_class.push(NestedClassRow {
                    nested: type_row,
                    enclosing,
                });
            }
            #[allow(clippy::cast_possible_truncation)]
            for (number, param) in entry.generic_params.iter().enumerate() {
                generic_params.push((token, number as u16, param));
            }
            for attribute in &entry.attributes {
                attributes.push((token, *attribute));
            }
        }

        for index in &field_order {
            let field = &self.fields[*index];
            let token = Token::from_parts(TableId::Field, next_row(tables.field.len()));
            tables.field.push(FieldRow {
                flags: field.flags,
                name: field.name.clone(),
                signature: field.signature.clone(),
            });
            if let Some(constant) = &field.constant {
                let (element_type, value) = constant.encode();
                tables.constant.push(ConstantRow {
                    element_type,
                    parent: token,
                    value,
                });
            }
        }

        for index in &method_order {
            let method = &self.methods[*index];
            let token = method_token(MethodId(*index))?;

            tables.method_def.push(MethodDefRow {
                rva: 0,
                impl_flags: 0,
                flags: method.flags,
                name: method.name.clone(),
                signature: method.signature.clone(),
                param_list: next_row(tables.param.len()),
            });

            #[allow(clippy::cast_possible_truncation)]
            for (position, param) in method.params.iter().enumerate() {
                let param_token = Token::from_parts(TableId::Param, next_row(tables.param.len()));
                tables.param.push(ParamRow {
                    flags: param.flags,
                    sequence: position as u16 + 1,
                    name: param.name.clone(),
                });
                if let Some(default) = &param.default {
                    let (element_type, value) = default.encode();
                    tables.constant.push(ConstantRow {
                        element_type,
                        parent: param_token,
                        value,
                    });
                }
                for attribute in &param.attributes {
                    attributes.push((param_token, *attribute));
                }
            }

            #[allow(clippy::cast_possible_truncation)]
            for (number, param) in method.generic_params.iter().enumerate() {
                generic_params.push((token, number as u16, param));
            }
            for attribute in &method.attributes {
                attributes.push((token, *attribute));
            }
            for target in &method.implements {
                let declaration = match target {
                    MethodTarget::Local(id) => method_token(*id)?,
                    MethodTarget::Token(token) => *token,
                };
                tables.method_impl.push(MethodImplRow {
                    class: method.owner,
                    body: token,
                    declaration,
                });
            }
        }

        let mut property_order: Vec<usize> = (0..self.properties.len()).collect();
        property_order.sort_by_key(|index| self.properties[*index].owner);
        for index in property_order {
            let property = &self.properties[index];
            let row = next_row(tables.property.len());
            let token = Token::from_parts(TableId::Property, row);
            if tables
                .property_map
                .last()
                .map_or(true, |map| map.parent != property.owner)
            {
                tables.property_map.push(PropertyMapRow {
                    parent: property.owner,
                    property_list: row,
                });
            }
            tables.property.push(PropertyRow {
                flags: property.flags,
                name: property.name.clone(),
                signature: property.signature.clone(),
            });

            let accessors = [
                (MethodSemanticsAttributes::GETTER, property.getter),
                (MethodSemanticsAttributes::SETTER, property.setter),
            ];
            for (semantics, method) in accessors {
                if let Some(method) = method {
                    tables.method_semantics.push(MethodSemanticsRow {
                        semantics,
                        method: method_token(method)?.row(),
                        association: token,
                    });
                }
            }
        }

        let mut event_order: Vec<usize> = (0..self.events.len()).collect();
        event_order.sort_by_key(|index| self.events[*index].owner);
        for index in event_order {
            let event = &self.events[index];
            let row = next_row(tables.event.len());
            let token = Token::from_parts(TableId::Event, row);
            if tables
                .event_map
                .last()
                .map_or(true, |map| map.parent != event.owner)
            {
                tables.event_map.push(EventMapRow {
                    parent: event.owner,
                    event_list: row,
                });
            }
            tables.event.push(EventRow {
                flags: event.flags,
                name: event.name.clone(),
                event_type: event.event_type,
            });

            let accessors = [
                (MethodSemanticsAttributes::ADD_ON, event.adder),
                (MethodSemanticsAttributes::REMOVE_ON, event.remover),
                (MethodSemanticsAttributes::FIRE, event.raiser),
            ];
            for (semantics, method) in accessors {
                if let Some(method) = method {
                    tables.method_semantics.push(MethodSemanticsRow {
                        semantics,
                        method: method_token(method)?.row(),
                        association: token,
                    });
                }
            }
        }

        generic_params.sort_by_key(|(owner, number, _)| {
            (coded_key(*owner, CodedIndexType::TypeOrMethodDef), *number)
        });
        for (owner, number, param) in generic_params {
            let row = next_row(tables.generic_param.len());
            tables.generic_param.push(GenericParamRow {
                number,
                flags: param.flags,
                owner,
                name: param.name.clone(),
            });
            for constraint in &param.constraints {
                tables
                    .generic_param_constraint
                    .push(GenericParamConstraintRow {
                        owner: row,
                        constraint: *constraint,
                    });
            }
        }

        let mut ctors: HashMap<Token, Token> = HashMap::new();
        for (parent, attribute_type) in attributes {
            let constructor = *ctors.entry(attribute_type).or_insert_with(|| {
                member_refs.push(MemberRefRow {
                    class: attribute_type,
                    name: ".ctor".to_string(),
                    signature: vec![0x20, 0x00, 0x01],
                });
                Token::from_parts(TableId::MemberRef, next_row(member_refs.len() - 1))
            });
            tables.custom_attribute.push(CustomAttributeRow {
                parent,
                constructor,
                value: EMPTY_ATTRIBUTE.to_vec(),
            });
        }
        tables.member_ref = member_refs;

        tables.interface_impl.sort_by_key(|row| row.class);
        tables.nested_class.sort_by_key(|row| row.nested);
        tables.method_impl.sort_by_key(|row| row.class);
        tables
            .constant
            .sort_by_key(|row| coded_key(row.parent, CodedIndexType::HasConstant));
        tables
            .custom_attribute
            .sort_by_key(|row| coded_key(row.parent, CodedIndexType::HasCustomAttribute));
        tables
            .method_semantics
            .sort_by_key(|row| coded_key(row.association, CodedIndexType::HasSemantics));

        Ok(tables)
    }

    /// Creates a resident module from the collected definitions.
    ///
    /// # Errors
    /// Returns the errors of [`ModuleBuilder::tables`].
    pub fn build(&self) -> Result<ModuleRc> {
        Module::from_tables(self.tables()?)
    }

    /// Serialises the module into a bare metadata image.
    ///
    /// # Errors
    /// Returns the errors of [`ModuleBuilder::tables`] and of the metadata writer.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        write_metadata(DEFAULT_VERSION, &self.tables()?)
    }

    /// Writes the metadata image to `path`.
    ///
    /// # Errors
    /// Returns the errors of [`ModuleBuilder::to_bytes`] and [`crate::Error::FileError`].
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }
}

/// A generic parameter of a type or method.
#[derive(Debug, Clone)]
pub struct GenericParameterBuilder {
    name: String,
    flags: GenericParamAttributes,
    constraints: Vec<TypeSignature>,
}

impl GenericParameterBuilder {
    /// Creates an invariant, unconstrained parameter.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        GenericParameterBuilder {
            name: name.into(),
            flags: GenericParamAttributes::empty(),
            constraints: Vec::new(),
        }
    }

    /// Adds variance and special constraint flags.
    #[must_use]
    pub fn flags(mut self, flags: GenericParamAttributes) -> Self {
        self.flags |= flags;
        self
    }

    /// Marks the parameter covariant (`out T`).
    #[must_use]
    pub fn covariant(self) -> Self {
        self.flags(GenericParamAttributes::COVARIANT)
    }

    /// Marks the parameter contravariant (`in T`).
    #[must_use]
    pub fn contravariant(self) -> Self {
        self.flags(GenericParamAttributes::CONTRAVARIANT)
    }

    /// Adds a base class or interface constraint.
    #[must_use]
    pub fn constraint(mut self, constraint: TypeSignature) -> Self {
        self.constraints.push(constraint);
        self
    }
}

impl From<&str> for GenericParameterBuilder {
    fn from(name: &str) -> Self {
        GenericParameterBuilder::new(name)
    }
}

enum BaseType {
    Default,
    Core(&'static str, &'static str),
    Explicit(TypeSignature),
    Nothing,
}

/// Builder for a type definition.
///
/// The constructors pick the flags and base type a C# compiler would emit for the kind of
/// type. Nested types redeclare the generic parameters of their enclosing type, so
/// `Outer<T>.Inner<U>` is a type with the parameters `T, U`.
pub struct TypeBuilder {
    flags: TypeAttributes,
    namespace: String,
    name: String,
    base: BaseType,
    enclosing: Option<Token>,
    interfaces: Vec<TypeSignature>,
    generic_params: Vec<GenericParameterBuilder>,
    attributes: Vec<(String, String)>,
    enum_underlying: Option<TypeSignature>,
}

impl TypeBuilder {
    fn with(
        flags: TypeAttributes,
        namespace: impl Into<String>,
        name: impl Into<String>,
        base: BaseType,
    ) -> Self {
        TypeBuilder {
            flags,
            namespace: namespace.into(),
            name: name.into(),
            base,
            enclosing: None,
            interfaces: Vec::new(),
            generic_params: Vec::new(),
            attributes: Vec::new(),
            enum_underlying: None,
        }
    }

    /// A public class deriving from `System.Object`.
    #[must_use]
    pub fn class(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::with(TypeAttributes::PUBLIC, namespace, name, BaseType::Default)
    }

    /// A public interface.
    #[must_use]
    pub fn interface(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::with(
            TypeAttributes::PUBLIC | TypeAttributes::INTERFACE | TypeAttributes::ABSTRACT,
            namespace,
            name,
            BaseType::Nothing,
        )
    }

    /// A public sealed struct deriving from `System.ValueType`.
    #[must_use]
    pub fn value_type(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::with(
            TypeAttributes::PUBLIC | TypeAttributes::SEALED | TypeAttributes::SEQUENTIAL_LAYOUT,
            namespace,
            name,
            BaseType::Core("System", "ValueType"),
        )
    }

    /// A public enum with the given underlying type, including its `value__` field.
    #[must_use]
    pub fn enumeration(
        namespace: impl Into<String>,
        name: impl Into<String>,
        underlying: TypeSignature,
    ) -> Self {
        let mut builder = Self::with(
            TypeAttributes::PUBLIC | TypeAttributes::SEALED,
            namespace,
            name,
            BaseType::Core("System", "Enum"),
        );
        builder.enum_underlying = Some(underlying);
        builder
    }

    /// A public sealed delegate deriving from `System.MulticastDelegate`.
    #[must_use]
    pub fn delegate(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::with(
            TypeAttributes::PUBLIC | TypeAttributes::SEALED,
            namespace,
            name,
            BaseType::Core("System", "MulticastDelegate"),
        )
    }

    /// Replaces the type attributes.
    #[must_use]
    pub fn flags(mut self, flags: TypeAttributes) -> Self {
        self.flags = flags;
        self
    }

    /// Adds to the type attributes.
    #[must_use]
    pub fn add_flags(mut self, flags: TypeAttributes) -> Self {
        self.flags |= flags;
        self
    }

    /// Sets the base type.
    #[must_use]
    pub fn extends(mut self, base: TypeSignature) -> Self {
        self.base = BaseType::Explicit(base);
        self
    }

    /// Declares the type without a base type, as `System.Object` and interfaces are.
    #[must_use]
    pub fn without_base(mut self) -> Self {
        self.base = BaseType::Nothing;
        self
    }

    /// Nests the type in the already built type `enclosing`.
    #[must_use]
    pub fn nested_in(mut self, enclosing: Token) -> Self {
        self.enclosing = Some(enclosing);
        self
    }

    /// Adds an interface implementation.
    #[must_use]
    pub fn implements(mut self, interface: TypeSignature) -> Self {
        self.interfaces.push(interface);
        self
    }

    /// Adds a generic parameter declared at this nesting level.
    #[must_use]
    pub fn generic_parameter(mut self, param: impl Into<GenericParameterBuilder>) -> Self {
        self.generic_params.push(param.into());
        self
    }

    /// Marks the type with a core library attribute without arguments.
    #[must_use]
    pub fn attribute(mut self, namespace: &str, name: &str) -> Self {
        self.attributes
            .push((namespace.to_string(), name.to_string()));
        self
    }

    /// Marks a static class as a container of extension methods.
    #[must_use]
    pub fn extension(self) -> Self {
        self.attribute("System.Runtime.CompilerServices", "ExtensionAttribute")
    }

    /// Adds the type to `module` and returns its `TypeDef` token.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidArgument`] for an empty name, an enclosing type that is not
    /// part of `module`, or a core library base that is not defined yet.
    pub fn build(self, module: &mut ModuleBuilder) -> Result<Token> {
        if self.name.is_empty() {
            return Err(Error::InvalidArgument("type name is empty".to_string()));
        }

        let mut flags = self.flags;
        let mut generic_params = Vec::new();
        let enclosing = match self.enclosing {
            Some(enclosing) => {
                let row = module.owner_row(enclosing)?;
                let visibility = if flags.bits() & TYPE_VISIBILITY_MASK
                    == TypeAttributes::PUBLIC.bits()
                {
                    TypeAttributes::NESTED_PUBLIC
                } else if flags.bits() & TYPE_VISIBILITY_MASK == 0 {
                    TypeAttributes::NESTED_PRIVATE
                } else {
                    TypeAttributes::from_bits_retain(flags.bits() & TYPE_VISIBILITY_MASK)
                };
                flags = TypeAttributes::from_bits_retain(
                    (flags.bits() & !TYPE_VISIBILITY_MASK) | visibility.bits(),
                );
                generic_params
                    .extend(module.types[row as usize - 1].generic_params.iter().cloned());
                Some(row)
            }
            None => None,
        };

        let extends = match &self.base {
            BaseType::Default => module.core_type("System", "Object")?,
            BaseType::Core(namespace, name) => module.core_type(namespace, name)?,
            BaseType::Explicit(base) => module.type_token(base)?,
            BaseType::Nothing => Token::new(0),
        };
        let interfaces = self
            .interfaces
            .iter()
            .map(|interface| module.type_token(interface))
            .collect::<Result<Vec<_>>>()?;
        generic_params.extend(module.generic_params(self.generic_params)?);
        let attributes = module.attribute_types(&self.attributes)?;

        module.types.push(TypeEntry {
            flags,
            name: self.name,
            namespace: if enclosing.is_some() {
                String::new()
            } else {
                self.namespace
            },
            extends,
            enclosing,
            interfaces,
            generic_params,
            attributes,
        });
        let token = Token::from_parts(TableId::TypeDef, next_row(module.types.len() - 1));

        if let Some(underlying) = self.enum_underlying {
            FieldBuilder::new("value__", underlying)
                .flags(
                    FieldAttributes::PUBLIC
                        | FieldAttributes::SPECIAL_NAME
                        | FieldAttributes::RT_SPECIAL_NAME,
                )
                .build(module, token)?;
        }

        Ok(token)
    }
}

/// Builder for a method parameter.
#[derive(Debug, Clone)]
pub struct ParameterBuilder {
    name: String,
    signature: SignatureParameter,
    flags: ParamAttributes,
    default: Option<ConstantValue>,
    attributes: Vec<(String, String)>,
}

impl ParameterBuilder {
    /// A by-value parameter of type `signature`.
    #[must_use]
    pub fn new(name: impl Into<String>, signature: TypeSignature) -> Self {
        ParameterBuilder {
            name: name.into(),
            signature: SignatureParameter::new(signature),
            flags: ParamAttributes::empty(),
            default: None,
            attributes: Vec::new(),
        }
    }

    /// Passes the parameter by reference (`ref`).
    #[must_use]
    pub fn by_ref(mut self) -> Self {
        self.signature.by_ref = true;
        self
    }

    /// An `out` parameter.
    #[must_use]
    pub fn out(mut self) -> Self {
        self.flags |= ParamAttributes::OUT;
        self.by_ref()
    }

    /// An `in` parameter, a read-only reference.
    #[must_use]
    pub fn in_ref(mut self) -> Self {
        self.flags |= ParamAttributes::IN;
        self.attribute("System.Runtime.CompilerServices", "IsReadOnlyAttribute")
            .by_ref()
    }

    /// An optional parameter with a default value.
    #[must_use]
    pub fn optional(mut self, default: ConstantValue) -> Self {
        self.flags |= ParamAttributes::OPTIONAL | ParamAttributes::HAS_DEFAULT;
        self.default = Some(default);
        self
    }

    /// A `params` array parameter.
    #[must_use]
    pub fn params_array(self) -> Self {
        self.attribute("System", "ParamArrayAttribute")
    }

    /// Adds parameter attributes.
    #[must_use]
    pub fn flags(mut self, flags: ParamAttributes) -> Self {
        self.flags |= flags;
        self
    }

    /// Marks the parameter with a core library attribute without arguments.
    #[must_use]
    pub fn attribute(mut self, namespace: &str, name: &str) -> Self {
        self.attributes
            .push((namespace.to_string(), name.to_string()));
        self
    }
}

impl From<(&str, TypeSignature)> for ParameterBuilder {
    fn from((name, signature): (&str, TypeSignature)) -> Self {
        ParameterBuilder::new(name, signature)
    }
}

/// Builder for a method, constructor or operator.
pub struct MethodBuilder {
    name: String,
    flags: MethodAttributes,
    return_type: SignatureParameter,
    params: Vec<ParameterBuilder>,
    generic_params: Vec<GenericParameterBuilder>,
    implements: Vec<MethodTarget>,
    attributes: Vec<(String, String)>,
}

impl MethodBuilder {
    /// A public instance method returning `void`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        MethodBuilder {
            name: name.into(),
            flags: MethodAttributes::PUBLIC | MethodAttributes::HIDE_BY_SIG,
            return_type: SignatureParameter::new(TypeSignature::Void),
            params: Vec::new(),
            generic_params: Vec::new(),
            implements: Vec::new(),
            attributes: Vec::new(),
        }
    }

    /// A public instance constructor.
    #[must_use]
    pub fn constructor() -> Self {
        Self::new(".ctor").add_flags(
            MethodAttributes::SPECIAL_NAME | MethodAttributes::RT_SPECIAL_NAME,
        )
    }

    /// The static type initializer.
    #[must_use]
    pub fn type_initializer() -> Self {
        Self::new(".cctor").flags(
            MethodAttributes::PRIVATE
                | MethodAttributes::STATIC
                | MethodAttributes::HIDE_BY_SIG
                | MethodAttributes::SPECIAL_NAME
                | MethodAttributes::RT_SPECIAL_NAME,
        )
    }

    /// A public static operator, `name` being its `op_*` special name.
    #[must_use]
    pub fn operator(name: impl Into<String>) -> Self {
        Self::new(name).add_flags(MethodAttributes::STATIC | MethodAttributes::SPECIAL_NAME)
    }

    /// Replaces the method attributes.
    #[must_use]
    pub fn flags(mut self, flags: MethodAttributes) -> Self {
        self.flags = flags;
        self
    }

    /// Adds to the method attributes.
    #[must_use]
    pub fn add_flags(mut self, flags: MethodAttributes) -> Self {
        self.flags |= flags;
        self
    }

    /// Makes the method static.
    #[must_use]
    pub fn static_method(self) -> Self {
        self.add_flags(MethodAttributes::STATIC)
    }

    /// Makes the method virtual with a new slot.
    #[must_use]
    pub fn virtual_method(self) -> Self {
        self.add_flags(MethodAttributes::VIRTUAL | MethodAttributes::NEW_SLOT)
    }

    /// Makes the method abstract.
    #[must_use]
    pub fn abstract_method(self) -> Self {
        self.add_flags(
            MethodAttributes::VIRTUAL | MethodAttributes::NEW_SLOT | MethodAttributes::ABSTRACT,
        )
    }

    /// Makes the method override a virtual method of a base type (reuses the slot).
    #[must_use]
    pub fn override_method(self) -> Self {
        self.add_flags(MethodAttributes::VIRTUAL)
    }

    /// Sets the return type.
    #[must_use]
    pub fn returns(mut self, return_type: TypeSignature) -> Self {
        self.return_type = SignatureParameter::new(return_type);
        self
    }

    /// Adds a parameter.
    #[must_use]
    pub fn parameter(mut self, param: impl Into<ParameterBuilder>) -> Self {
        self.params.push(param.into());
        self
    }

    /// Adds a generic parameter of the method.
    #[must_use]
    pub fn generic_parameter(mut self, param: impl Into<GenericParameterBuilder>) -> Self {
        self.generic_params.push(param.into());
        self
    }

    /// Binds the method to an interface or base method through a `MethodImpl` row, the way
    /// explicit interface implementations are emitted.
    #[must_use]
    pub fn implements(mut self, declaration: impl Into<MethodTarget>) -> Self {
        self.implements.push(declaration.into());
        self
    }

    /// Marks the method with a core library attribute without arguments.
    #[must_use]
    pub fn attribute(mut self, namespace: &str, name: &str) -> Self {
        self.attributes
            .push((namespace.to_string(), name.to_string()));
        self
    }

    /// Marks the method as an extension method.
    #[must_use]
    pub fn extension(self) -> Self {
        self.attribute("System.Runtime.CompilerServices", "ExtensionAttribute")
    }

    /// Adds the method to the type `owner` of `module`.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidArgument`] for an empty name or an owner that is not a type
    /// of `module`, and encoding errors for unencodable signatures.
    pub fn build(self, module: &mut ModuleBuilder, owner: Token) -> Result<MethodId> {
        if self.name.is_empty() {
            return Err(Error::InvalidArgument("method name is empty".to_string()));
        }
        let owner = module.owner_row(owner)?;

        #[allow(clippy::cast_possible_truncation)]
        let signature = SignatureMethod {
            has_this: !self.flags.contains(MethodAttributes::STATIC),
            param_count_generic: self.generic_params.len() as u32,
            return_type: self.return_type,
            params: self.params.iter().map(|p| p.signature.clone()).collect(),
            ..SignatureMethod::default()
        };

        let mut params = Vec::with_capacity(self.params.len());
        for param in self.params {
            params.push(ParamEntry {
                attributes: module.attribute_types(&param.attributes)?,
                name: param.name,
                flags: param.flags,
                default: param.default,
            });
        }

        let entry = MethodEntry {
            owner,
            flags: self.flags,
            name: self.name,
            signature: encode_method_signature(&signature)?,
            params,
            generic_params: module.generic_params(self.generic_params)?,
            implements: self.implements,
            attributes: module.attribute_types(&self.attributes)?,
        };
        module.methods.push(entry);
        Ok(MethodId(module.methods.len() - 1))
    }
}

/// Builder for a field.
pub struct FieldBuilder {
    name: String,
    flags: FieldAttributes,
    signature: TypeSignature,
    constant: Option<ConstantValue>,
}

impl FieldBuilder {
    /// A public instance field.
    #[must_use]
    pub fn new(name: impl Into<String>, signature: TypeSignature) -> Self {
        FieldBuilder {
            name: name.into(),
            flags: FieldAttributes::PUBLIC,
            signature,
            constant: None,
        }
    }

    /// Replaces the field attributes.
    #[must_use]
    pub fn flags(mut self, flags: FieldAttributes) -> Self {
        self.flags = flags;
        self
    }

    /// Adds to the field attributes.
    #[must_use]
    pub fn add_flags(mut self, flags: FieldAttributes) -> Self {
        self.flags |= flags;
        self
    }

    /// Turns the field into a compile-time constant (`const`, or an enum member).
    #[must_use]
    pub fn constant(mut self, value: ConstantValue) -> Self {
        self.flags |=
            FieldAttributes::STATIC | FieldAttributes::LITERAL | FieldAttributes::HAS_DEFAULT;
        self.constant = Some(value);
        self
    }

    /// Adds the field to the type `owner` of `module`.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidArgument`] for an empty name or an owner that is not a type
    /// of `module`.
    pub fn build(self, module: &mut ModuleBuilder, owner: Token) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::InvalidArgument("field name is empty".to_string()));
        }
        let owner = module.owner_row(owner)?;
        let signature = encode_field_signature(&SignatureField {
            modifiers: Vec::new(),
            base: self.signature,
        })?;

        module.fields.push(FieldEntry {
            owner,
            flags: self.flags,
            name: self.name,
            signature,
            constant: self.constant,
        });
        Ok(())
    }
}

/// Builder for a property.
pub struct PropertyBuilder {
    name: String,
    signature: TypeSignature,
    is_static: bool,
    index: Vec<TypeSignature>,
    getter: Option<MethodId>,
    setter: Option<MethodId>,
}

impl PropertyBuilder {
    /// An instance property of type `signature`.
    #[must_use]
    pub fn new(name: impl Into<String>, signature: TypeSignature) -> Self {
        PropertyBuilder {
            name: name.into(),
            signature,
            is_static: false,
            index: Vec::new(),
            getter: None,
            setter: None,
        }
    }

    /// Makes the property static.
    #[must_use]
    pub fn static_property(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Adds an index parameter, turning the property into an indexer.
    #[must_use]
    pub fn index(mut self, signature: TypeSignature) -> Self {
        self.index.push(signature);
        self
    }

    /// Sets the `get` accessor.
    #[must_use]
    pub fn getter(mut self, method: MethodId) -> Self {
        self.getter = Some(method);
        self
    }

    /// Sets the `set` accessor.
    #[must_use]
    pub fn setter(mut self, method: MethodId) -> Self {
        self.setter = Some(method);
        self
    }

    /// Adds the property to the type `owner` of `module`.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidArgument`] for an empty name or an owner that is not a type
    /// of `module`.
    pub fn build(self, module: &mut ModuleBuilder, owner: Token) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::InvalidArgument("property name is empty".to_string()));
        }
        let owner = module.owner_row(owner)?;
        let signature = encode_property_signature(&SignatureProperty {
            has_this: !self.is_static,
            modifiers: Vec::new(),
            base: self.signature,
            params: self.index.into_iter().map(SignatureParameter::new).collect(),
        })?;

        module.properties.push(PropertyEntry {
            owner,
            flags: PropertyAttributes::empty(),
            name: self.name,
            signature,
            getter: self.getter,
            setter: self.setter,
        });
        Ok(())
    }
}

/// Builder for an event.
pub struct EventBuilder {
    name: String,
    event_type: TypeSignature,
    adder: Option<MethodId>,
    remover: Option<MethodId>,
    raiser: Option<MethodId>,
}

impl EventBuilder {
    /// An event whose handlers are of the delegate type `event_type`.
    #[must_use]
    pub fn new(name: impl Into<String>, event_type: TypeSignature) -> Self {
        EventBuilder {
            name: name.into(),
            event_type,
            adder: None,
            remover: None,
            raiser: None,
        }
    }

    /// Sets the `add` accessor.
    #[must_use]
    pub fn adder(mut self, method: MethodId) -> Self {
        self.adder = Some(method);
        self
    }

    /// Sets the `remove` accessor.
    #[must_use]
    pub fn remover(mut self, method: MethodId) -> Self {
        self.remover = Some(method);
        self
    }

    /// Sets the raise method.
    #[must_use]
    pub fn raiser(mut self, method: MethodId) -> Self {
        self.raiser = Some(method);
        self
    }

    /// Adds the event to the type `owner` of `module`.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidArgument`] for an empty name or an owner that is not a type
    /// of `module`.
    pub fn build(self, module: &mut ModuleBuilder, owner: Token) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::InvalidArgument("event name is empty".to_string()));
        }
        let owner = module.owner_row(owner)?;
        let event_type = module.type_token(&self.event_type)?;

        module.events.push(EventEntry {
            owner,
            flags: EventAttributes::empty(),
            name: self.name,
            event_type,
            adder: self.adder,
            remover: self.remover,
            raiser: self.raiser,
        });
        Ok(())
    }
}
