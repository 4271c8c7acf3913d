//! Decoded rows of the tables the model consumes, and [`MetadataTables`], their container.
//!
//! Heap columns are resolved to owned values; simple indexes stay one-based row numbers and coded
//! indexes become [`Token`]s. Row vectors are zero-based, so row `n` lives at index `n - 1`.

use std::ops::Range;

use strum::EnumCount;

use crate::{
    metadata::{
        flags::{
            EventAttributes, FieldAttributes, GenericParamAttributes, MethodAttributes,
            MethodSemanticsAttributes, ParamAttributes, PropertyAttributes, TypeAttributes,
        },
        tables::{
            codec::{RowReader, RowWriter, TableRow},
            CodedIndexType as C, TableId,
        },
        token::Token,
    },
    Result,
};

#[allow(clippy::cast_possible_truncation)]
fn flags16(value: u32) -> u16 {
    value as u16
}

/// A `Module` row (0x00)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRow {
    /// Reserved, always 0
    pub generation: u16,
    /// Name of the module file
    pub name: String,
    /// Module version id
    pub mvid: uguid::Guid,
}

impl TableRow for ModuleRow {
    const TABLE: TableId = TableId::Module;

    fn read(row: &mut RowReader<'_, '_>) -> Result<Self> {
        Ok(ModuleRow {
            generation: flags16(row.fixed()),
            name: row.string()?,
            mvid: row.guid()?,
        })
    }

    fn write(&self, row: &mut RowWriter<'_>) -> Result<()> {
        row.fixed(u32::from(self.generation));
        row.string(&self.name);
        row.guid(self.mvid);
        row.guid(uguid::Guid::ZERO);
        row.guid(uguid::Guid::ZERO);
        Ok(())
    }
}

/// A `TypeRef` row (0x01)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRefRow {
    /// Module, ModuleRef, AssemblyRef or enclosing TypeRef
    pub resolution_scope: Token,
    /// Type name
    pub name: String,
    /// Type namespace
    pub namespace: String,
}

impl TableRow for TypeRefRow {
    const TABLE: TableId = TableId::TypeRef;

    fn read(row: &mut RowReader<'_, '_>) -> Result<Self> {
        Ok(TypeRefRow {
            resolution_scope: row.coded(C::ResolutionScope)?,
            name: row.string()?,
            namespace: row.string()?,
        })
    }

    fn write(&self, row: &mut RowWriter<'_>) -> Result<()> {
        row.coded(self.resolution_scope, C::ResolutionScope)?;
        row.string(&self.name);
        row.string(&self.namespace);
        Ok(())
    }
}

/// A `TypeDef` row (0x02)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDefRow {
    /// Type attributes
    pub flags: TypeAttributes,
    /// Type name
    pub name: String,
    /// Type namespace, empty for nested types
    pub namespace: String,
    /// Base type, null for interfaces and `System.Object`
    pub extends: Token,
    /// First row of the field run
    pub field_list: u32,
    /// First row of the method run
    pub method_list: u32,
}

impl TableRow for TypeDefRow {
    const TABLE: TableId = TableId::TypeDef;

    fn read(row: &mut RowReader<'_, '_>) -> Result<Self> {
        Ok(TypeDefRow {
            flags: TypeAttributes::from_bits_retain(row.fixed()),
            name: row.string()?,
            namespace: row.string()?,
            extends: row.coded(C::TypeDefOrRef)?,
            field_list: row.index(),
            method_list: row.index(),
        })
    }

    fn write(&self, row: &mut RowWriter<'_>) -> Result<()> {
        row.fixed(self.flags.bits());
        row.string(&self.name);
        row.string(&self.namespace);
        row.coded(self.extends, C::TypeDefOrRef)?;
        row.index(self.field_list);
        row.index(self.method_list);
        Ok(())
    }
}

/// A `Field` row (0x04)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRow {
    /// Field attributes
    pub flags: FieldAttributes,
    /// Field name
    pub name: String,
    /// Field signature blob
    pub signature: Vec<u8>,
}

impl TableRow for FieldRow {
    const TABLE: TableId = TableId::Field;

    fn read(row: &mut RowReader<'_, '_>) -> Result<Self> {
        Ok(FieldRow {
            flags: FieldAttributes::from_bits_retain(flags16(row.fixed())),
            name: row.string()?,
            signature: row.blob()?,
        })
    }

    fn write(&self, row: &mut RowWriter<'_>) -> Result<()> {
        row.fixed(u32::from(self.flags.bits()));
        row.string(&self.name);
        row.blob(&self.signature);
        Ok(())
    }
}

/// A `MethodDef` row (0x06)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDefRow {
    /// RVA of the method body, 0 for abstract and extern methods
    pub rva: u32,
    /// Method implementation attributes
    pub impl_flags: u16,
    /// Method attributes
    pub flags: MethodAttributes,
    /// Method name
    pub name: String,
    /// Method signature blob
    pub signature: Vec<u8>,
    /// First row of the parameter run
    pub param_list: u32,
}

impl TableRow for MethodDefRow {
    const TABLE: TableId = TableId::MethodDef;

    fn read(row: &mut RowReader<'_, '_>) -> Result<Self> {
        Ok(MethodDefRow {
            rva: row.fixed(),
            impl_flags: flags16(row.fixed()),
            flags: MethodAttributes::from_bits_retain(flags16(row.fixed())),
            name: row.string()?,
            signature: row.blob()?,
            param_list: row.index(),
        })
    }

    fn write(&self, row: &mut RowWriter<'_>) -> Result<()> {
        row.fixed(self.rva);
        row.fixed(u32::from(self.impl_flags));
        row.fixed(u32::from(self.flags.bits()));
        row.string(&self.name);
        row.blob(&self.signature);
        row.index(self.param_list);
        Ok(())
    }
}

/// A `Param` row (0x08)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamRow {
    /// Parameter attributes
    pub flags: ParamAttributes,
    /// 1-based position, 0 for the return value
    pub sequence: u16,
    /// Parameter name
    pub name: String,
}

impl TableRow for ParamRow {
    const TABLE: TableId = TableId::Param;

    fn read(row: &mut RowReader<'_, '_>) -> Result<Self> {
        Ok(ParamRow {
            flags: ParamAttributes::from_bits_retain(flags16(row.fixed())),
            sequence: flags16(row.fixed()),
            name: row.string()?,
        })
    }

    fn write(&self, row: &mut RowWriter<'_>) -> Result<()> {
        row.fixed(u32::from(self.flags.bits()));
        row.fixed(u32::from(self.sequence));
        row.string(&self.name);
        Ok(())
    }
}

/// An `InterfaceImpl` row (0x09)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceImplRow {
    /// Implementing TypeDef row
    pub class: u32,
    /// Implemented interface
    pub interface: Token,
}

impl TableRow for InterfaceImplRow {
    const TABLE: TableId = TableId::InterfaceImpl;

    fn read(row: &mut RowReader<'_, '_>) -> Result<Self> {
        Ok(InterfaceImplRow {
            class: row.index(),
            interface: row.coded(C::TypeDefOrRef)?,
        })
    }

    fn write(&self, row: &mut RowWriter<'_>) -> Result<()> {
        row.index(self.class);
        row.coded(self.interface, C::TypeDefOrRef)
    }
}

/// A `MemberRef` row (0x0A)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRefRow {
    /// TypeDef, TypeRef, ModuleRef, MethodDef or TypeSpec the member lives in
    pub class: Token,
    /// Member name
    pub name: String,
    /// Field or method signature blob
    pub signature: Vec<u8>,
}

impl TableRow for MemberRefRow {
    const TABLE: TableId = TableId::MemberRef;

    fn read(row: &mut RowReader<'_, '_>) -> Result<Self> {
        Ok(MemberRefRow {
            class: row.coded(C::MemberRefParent)?,
            name: row.string()?,
            signature: row.blob()?,
        })
    }

    fn write(&self, row: &mut RowWriter<'_>) -> Result<()> {
        row.coded(self.class, C::MemberRefParent)?;
        row.string(&self.name);
        row.blob(&self.signature);
        Ok(())
    }
}

/// A `Constant` row (0x0B)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantRow {
    /// Element type of the value
    pub element_type: u8,
    /// Field, Param or Property owning the value
    pub parent: Token,
    /// Value blob
    pub value: Vec<u8>,
}

impl TableRow for ConstantRow {
    const TABLE: TableId = TableId::Constant;

    fn read(row: &mut RowReader<'_, '_>) -> Result<Self> {
        Ok(ConstantRow {
            element_type: row.fixed().to_le_bytes()[0],
            parent: row.coded(C::HasConstant)?,
            value: row.blob()?,
        })
    }

    fn write(&self, row: &mut RowWriter<'_>) -> Result<()> {
        row.fixed(u32::from(self.element_type));
        row.coded(self.parent, C::HasConstant)?;
        row.blob(&self.value);
        Ok(())
    }
}

/// A `CustomAttribute` row (0x0C)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomAttributeRow {
    /// Attributed entity
    pub parent: Token,
    /// Attribute constructor, a MethodDef or MemberRef
    pub constructor: Token,
    /// Argument blob
    pub value: Vec<u8>,
}

impl TableRow for CustomAttributeRow {
    const TABLE: TableId = TableId::CustomAttribute;

    fn read(row: &mut RowReader<'_, '_>) -> Result<Self> {
        Ok(CustomAttributeRow {
            parent: row.coded(C::HasCustomAttribute)?,
            constructor: row.coded(C::CustomAttributeType)?,
            value: row.blob()?,
        })
    }

    fn write(&self, row: &mut RowWriter<'_>) -> Result<()> {
        row.coded(self.parent, C::HasCustomAttribute)?;
        row.coded(self.constructor, C::CustomAttributeType)?;
        row.blob(&self.value);
        Ok(())
    }
}

/// An `EventMap` row (0x12)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventMapRow {
    /// Owning TypeDef row
    pub parent: u32,
    /// First row of the event run
    pub event_list: u32,
}

impl TableRow for EventMapRow {
    const TABLE: TableId = TableId::EventMap;

    fn read(row: &mut RowReader<'_, '_>) -> Result<Self> {
        Ok(EventMapRow {
            parent: row.index(),
            event_list: row.index(),
        })
    }

    fn write(&self, row: &mut RowWriter<'_>) -> Result<()> {
        row.index(self.parent);
        row.index(self.event_list);
        Ok(())
    }
}

/// An `Event` row (0x14)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRow {
    /// Event attributes
    pub flags: EventAttributes,
    /// Event name
    pub name: String,
    /// Delegate type of the event
    pub event_type: Token,
}

impl TableRow for EventRow {
    const TABLE: TableId = TableId::Event;

    fn read(row: &mut RowReader<'_, '_>) -> Result<Self> {
        Ok(EventRow {
            flags: EventAttributes::from_bits_retain(flags16(row.fixed())),
            name: row.string()?,
            event_type: row.coded(C::TypeDefOrRef)?,
        })
    }

    fn write(&self, row: &mut RowWriter<'_>) -> Result<()> {
        row.fixed(u32::from(self.flags.bits()));
        row.string(&self.name);
        row.coded(self.event_type, C::TypeDefOrRef)
    }
}

/// A `PropertyMap` row (0x15)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyMapRow {
    /// Owning TypeDef row
    pub parent: u32,
    /// First row of the property run
    pub property_list: u32,
}

impl TableRow for PropertyMapRow {
    const TABLE: TableId = TableId::PropertyMap;

    fn read(row: &mut RowReader<'_, '_>) -> Result<Self> {
        Ok(PropertyMapRow {
            parent: row.index(),
            property_list: row.index(),
        })
    }

    fn write(&self, row: &mut RowWriter<'_>) -> Result<()> {
        row.index(self.parent);
        row.index(self.property_list);
        Ok(())
    }
}

/// A `Property` row (0x17)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyRow {
    /// Property attributes
    pub flags: PropertyAttributes,
    /// Property name
    pub name: String,
    /// Property signature blob
    pub signature: Vec<u8>,
}

impl TableRow for PropertyRow {
    const TABLE: TableId = TableId::Property;

    fn read(row: &mut RowReader<'_, '_>) -> Result<Self> {
        Ok(PropertyRow {
            flags: PropertyAttributes::from_bits_retain(flags16(row.fixed())),
            name: row.string()?,
            signature: row.blob()?,
        })
    }

    fn write(&self, row: &mut RowWriter<'_>) -> Result<()> {
        row.fixed(u32::from(self.flags.bits()));
        row.string(&self.name);
        row.blob(&self.signature);
        Ok(())
    }
}

/// A `MethodSemantics` row (0x18)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSemanticsRow {
    /// Role of the method
    pub semantics: MethodSemanticsAttributes,
    /// Accessor MethodDef row
    pub method: u32,
    /// Event or Property the accessor belongs to
    pub association: Token,
}

impl TableRow for MethodSemanticsRow {
    const TABLE: TableId = TableId::MethodSemantics;

    fn read(row: &mut RowReader<'_, '_>) -> Result<Self> {
        Ok(MethodSemanticsRow {
            semantics: MethodSemanticsAttributes::from_bits_retain(flags16(row.fixed())),
            method: row.index(),
            association: row.coded(C::HasSemantics)?,
        })
    }

    fn write(&self, row: &mut RowWriter<'_>) -> Result<()> {
        row.fixed(u32::from(self.semantics.bits()));
        row.index(self.method);
        row.coded(self.association, C::HasSemantics)
    }
}

/// A `MethodImpl` row (0x19)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodImplRow {
    /// Implementing TypeDef row
    pub class: u32,
    /// The implementing method
    pub body: Token,
    /// The implemented or overridden declaration
    pub declaration: Token,
}

impl TableRow for MethodImplRow {
    const TABLE: TableId = TableId::MethodImpl;

    fn read(row: &mut RowReader<'_, '_>) -> Result<Self> {
        Ok(MethodImplRow {
            class: row.index(),
            body: row.coded(C::MethodDefOrRef)?,
            declaration: row.coded(C::MethodDefOrRef)?,
        })
    }

    fn write(&self, row: &mut RowWriter<'_>) -> Result<()> {
        row.index(self.class);
        row.coded(self.body, C::MethodDefOrRef)?;
        row.coded(self.declaration, C::MethodDefOrRef)
    }
}

/// A `ModuleRef` row (0x1A)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRefRow {
    /// Referenced module file name
    pub name: String,
}

impl TableRow for ModuleRefRow {
    const TABLE: TableId = TableId::ModuleRef;

    fn read(row: &mut RowReader<'_, '_>) -> Result<Self> {
        Ok(ModuleRefRow { name: row.string()? })
    }

    fn write(&self, row: &mut RowWriter<'_>) -> Result<()> {
        row.string(&self.name);
        Ok(())
    }
}

/// A `TypeSpec` row (0x1B)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSpecRow {
    /// Type signature blob
    pub signature: Vec<u8>,
}

impl TableRow for TypeSpecRow {
    const TABLE: TableId = TableId::TypeSpec;

    fn read(row: &mut RowReader<'_, '_>) -> Result<Self> {
        Ok(TypeSpecRow {
            signature: row.blob()?,
        })
    }

    fn write(&self, row: &mut RowWriter<'_>) -> Result<()> {
        row.blob(&self.signature);
        Ok(())
    }
}

/// An `Assembly` row (0x20)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyRow {
    /// Hash algorithm id
    pub hash_alg_id: u32,
    /// Major, minor, build and revision number
    pub version: [u16; 4],
    /// Assembly flags
    pub flags: u32,
    /// Public key blob
    pub public_key: Vec<u8>,
    /// Simple assembly name
    pub name: String,
    /// Culture, empty for neutral
    pub culture: String,
}

impl TableRow for AssemblyRow {
    const TABLE: TableId = TableId::Assembly;

    fn read(row: &mut RowReader<'_, '_>) -> Result<Self> {
        Ok(AssemblyRow {
            hash_alg_id: row.fixed(),
            version: [
                flags16(row.fixed()),
                flags16(row.fixed()),
                flags16(row.fixed()),
                flags16(row.fixed()),
            ],
            flags: row.fixed(),
            public_key: row.blob()?,
            name: row.string()?,
            culture: row.string()?,
        })
    }

    fn write(&self, row: &mut RowWriter<'_>) -> Result<()> {
        row.fixed(self.hash_alg_id);
        for part in self.version {
            row.fixed(u32::from(part));
        }
        row.fixed(self.flags);
        row.blob(&self.public_key);
        row.string(&self.name);
        row.string(&self.culture);
        Ok(())
    }
}

/// An `AssemblyRef` row (0x23)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyRefRow {
    /// Major, minor, build and revision number
    pub version: [u16; 4],
    /// Assembly flags
    pub flags: u32,
    /// Public key or token blob
    pub public_key_or_token: Vec<u8>,
    /// Simple assembly name
    pub name: String,
    /// Culture, empty for neutral
    pub culture: String,
    /// Hash blob
    pub hash_value: Vec<u8>,
}

impl TableRow for AssemblyRefRow {
    const TABLE: TableId = TableId::AssemblyRef;

    fn read(row: &mut RowReader<'_, '_>) -> Result<Self> {
        Ok(AssemblyRefRow {
            version: [
                flags16(row.fixed()),
                flags16(row.fixed()),
                flags16(row.fixed()),
                flags16(row.fixed()),
            ],
            flags: row.fixed(),
            public_key_or_token: row.blob()?,
            name: row.string()?,
            culture: row.string()?,
            hash_value: row.blob()?,
        })
    }

    fn write(&self, row: &mut RowWriter<'_>) -> Result<()> {
        for part in self.version {
            row.fixed(u32::from(part));
        }
        row.fixed(self.flags);
        row.blob(&self.public_key_or_token);
        row.string(&self.name);
        row.string(&self.culture);
        row.blob(&self.hash_value);
        Ok(())
    }
}

/// A `NestedClass` row (0x29)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestedClassRow {
    /// Nested TypeDef row
    pub nested: u32,
    /// Enclosing TypeDef row
    pub enclosing: u32,
}

impl TableRow for NestedClassRow {
    const TABLE: TableId = TableId::NestedClass;

    fn read(row: &mut RowReader<'_, '_>) -> Result<Self> {
        Ok(NestedClassRow {
            nested: row.index(),
            enclosing: row.index(),
        })
    }

    fn write(&self, row: &mut RowWriter<'_>) -> Result<()> {
        row.index(self.nested);
        row.index(self.enclosing);
        Ok(())
    }
}

/// A `GenericParam` row (0x2A)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericParamRow {
    /// Position within the owner's full parameter list
    pub number: u16,
    /// Variance and special constraints
    pub flags: GenericParamAttributes,
    /// Owning TypeDef or MethodDef
    pub owner: Token,
    /// Parameter name
    pub name: String,
}

impl TableRow for GenericParamRow {
    const TABLE: TableId = TableId::GenericParam;

    fn read(row: &mut RowReader<'_, '_>) -> Result<Self> {
        Ok(GenericParamRow {
            number: flags16(row.fixed()),
            flags: GenericParamAttributes::from_bits_retain(flags16(row.fixed())),
            owner: row.coded(C::TypeOrMethodDef)?,
            name: row.string()?,
        })
    }

    fn write(&self, row: &mut RowWriter<'_>) -> Result<()> {
        row.fixed(u32::from(self.number));
        row.fixed(u32::from(self.flags.bits()));
        row.coded(self.owner, C::TypeOrMethodDef)?;
        row.string(&self.name);
        Ok(())
    }
}

/// A `MethodSpec` row (0x2B)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSpecRow {
    /// Instantiated MethodDef or MemberRef
    pub method: Token,
    /// Instantiation blob
    pub instantiation: Vec<u8>,
}

impl TableRow for MethodSpecRow {
    const TABLE: TableId = TableId::MethodSpec;

    fn read(row: &mut RowReader<'_, '_>) -> Result<Self> {
        Ok(MethodSpecRow {
            method: row.coded(C::MethodDefOrRef)?,
            instantiation: row.blob()?,
        })
    }

    fn write(&self, row: &mut RowWriter<'_>) -> Result<()> {
        row.coded(self.method, C::MethodDefOrRef)?;
        row.blob(&self.instantiation);
        Ok(())
    }
}

/// A `GenericParamConstraint` row (0x2C)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericParamConstraintRow {
    /// Constrained GenericParam row
    pub owner: u32,
    /// Required base type or interface
    pub constraint: Token,
}

impl TableRow for GenericParamConstraintRow {
    const TABLE: TableId = TableId::GenericParamConstraint;

    fn read(row: &mut RowReader<'_, '_>) -> Result<Self> {
        Ok(GenericParamConstraintRow {
            owner: row.index(),
            constraint: row.coded(C::TypeDefOrRef)?,
        })
    }

    fn write(&self, row: &mut RowWriter<'_>) -> Result<()> {
        row.index(self.owner);
        row.coded(self.constraint, C::TypeDefOrRef)
    }
}

/// The decoded tables of one module.
///
/// Pointer tables (`FieldPtr`, `MethodPtr`, ...) only appear in unoptimized metadata; when they are
/// non-empty, the `*_list` columns of the owning rows index into them instead of the target table.
#[derive(Debug, Clone, Default)]
#[allow(missing_docs)]
pub struct MetadataTables {
    pub module: Vec<ModuleRow>,
    pub type_ref: Vec<TypeRefRow>,
    pub type_def: Vec<TypeDefRow>,
    pub field_ptr: Vec<u32>,
    pub field: Vec<FieldRow>,
    pub method_ptr: Vec<u32>,
    pub method_def: Vec<MethodDefRow>,
    pub param_ptr: Vec<u32>,
    pub param: Vec<ParamRow>,
    pub interface_impl: Vec<InterfaceImplRow>,
    pub member_ref: Vec<MemberRefRow>,
    pub constant: Vec<ConstantRow>,
    pub custom_attribute: Vec<CustomAttributeRow>,
    pub event_map: Vec<EventMapRow>,
    pub event_ptr: Vec<u32>,
    pub event: Vec<EventRow>,
    pub property_map: Vec<PropertyMapRow>,
    pub property_ptr: Vec<u32>,
    pub property: Vec<PropertyRow>,
    pub method_semantics: Vec<MethodSemanticsRow>,
    pub method_impl: Vec<MethodImplRow>,
    pub module_ref: Vec<ModuleRefRow>,
    pub type_spec: Vec<TypeSpecRow>,
    pub assembly: Vec<AssemblyRow>,
    pub assembly_ref: Vec<AssemblyRefRow>,
    pub nested_class: Vec<NestedClassRow>,
    pub generic_param: Vec<GenericParamRow>,
    pub method_spec: Vec<MethodSpecRow>,
    pub generic_param_constraint: Vec<GenericParamConstraintRow>,
}

/// Returns the one-based `row` of `rows`.
#[must_use]
pub fn row<T>(rows: &[T], row: u32) -> Option<&T> {
    rows.get((row as usize).checked_sub(1)?)
}

/// Resolves a `*_list` run: the rows from `start` up to the next owner's `start` (or the end of
/// the table), followed through `ptr` when the pointer table is present.
fn run(start: u32, next: Option<u32>, target_len: usize, ptr: &[u32]) -> Vec<u32> {
    let available = if ptr.is_empty() { target_len } else { ptr.len() };
    #[allow(clippy::cast_possible_truncation)]
    let limit = available as u32 + 1;

    let start = start.clamp(1, limit);
    let end = next.unwrap_or(limit).clamp(start, limit);
    let range: Range<u32> = start..end;

    if ptr.is_empty() {
        range.collect()
    } else {
        range
            .filter_map(|index| ptr.get(index as usize - 1).copied())
            .collect()
    }
}

impl MetadataTables {
    /// Row counts of every table, indexed by [`TableId`].
    #[must_use]
    pub fn row_counts(&self) -> [u32; TableId::COUNT] {
        let mut rows = [0_u32; TableId::COUNT];
        let mut set = |id: TableId, len: usize| {
            rows[id as usize] = u32::try_from(len).unwrap_or(u32::MAX);
        };

        set(TableId::Module, self.module.len());
        set(TableId::TypeRef, self.type_ref.len());
        set(TableId::TypeDef, self.type_def.len());
        set(TableId::FieldPtr, self.field_ptr.len());
        set(TableId::Field, self.field.len());
        set(TableId::MethodPtr, self.method_ptr.len());
        set(TableId::MethodDef, self.method_def.len());
        set(TableId::ParamPtr, self.param_ptr.len());
        set(TableId::Param, self.param.len());
        set(TableId::InterfaceImpl, self.interface_impl.len());
        set(TableId::MemberRef, self.member_ref.len());
        set(TableId::Constant, self.constant.len());
        set(TableId::CustomAttribute, self.custom_attribute.len());
        set(TableId::EventMap, self.event_map.len());
        set(TableId::EventPtr, self.event_ptr.len());
        set(TableId::Event, self.event.len());
        set(TableId::PropertyMap, self.property_map.len());
        set(TableId::PropertyPtr, self.property_ptr.len());
        set(TableId::Property, self.property.len());
        set(TableId::MethodSemantics, self.method_semantics.len());
        set(TableId::MethodImpl, self.method_impl.len());
        set(TableId::ModuleRef, self.module_ref.len());
        set(TableId::TypeSpec, self.type_spec.len());
        set(TableId::Assembly, self.assembly.len());
        set(TableId::AssemblyRef, self.assembly_ref.len());
        set(TableId::NestedClass, self.nested_class.len());
        set(TableId::GenericParam, self.generic_param.len());
        set(TableId::MethodSpec, self.method_spec.len());
        set(TableId::GenericParamConstraint, self.generic_param_constraint.len());

        rows
    }

    /// Field rows owned by the one-based TypeDef `type_row`.
    #[must_use]
    pub fn fields_of(&self, type_row: u32) -> Vec<u32> {
        let Some(owner) = row(&self.type_def, type_row) else {
            return Vec::new();
        };
        let next = row(&self.type_def, type_row + 1).map(|next| next.field_list);
        run(owner.field_list, next, self.field.len(), &self.field_ptr)
    }

    /// Method rows owned by the one-based TypeDef `type_row`.
    #[must_use]
    pub fn methods_of(&self, type_row: u32) -> Vec<u32> {
        let Some(owner) = row(&self.type_def, type_row) else {
            return Vec::new();
        };
        let next = row(&self.type_def, type_row + 1).map(|next| next.method_list);
        run(owner.method_list, next, self.method_def.len(), &self.method_ptr)
    }

    /// Param rows owned by the one-based MethodDef `method_row`.
    #[must_use]
    pub fn params_of(&self, method_row: u32) -> Vec<u32> {
        let Some(owner) = row(&self.method_def, method_row) else {
            return Vec::new();
        };
        let next = row(&self.method_def, method_row + 1).map(|next| next.param_list);
        run(owner.param_list, next, self.param.len(), &self.param_ptr)
    }

    /// Event rows owned by the one-based TypeDef `type_row`.
    #[must_use]
    pub fn events_of(&self, type_row: u32) -> Vec<u32> {
        let Some(index) = self.event_map.iter().position(|map| map.parent == type_row) else {
            return Vec::new();
        };
        let next = self.event_map.get(index + 1).map(|next| next.event_list);
        run(
            self.event_map[index].event_list,
            next,
            self.event.len(),
            &self.event_ptr,
        )
    }

    /// Property rows owned by the one-based TypeDef `type_row`.
    #[must_use]
    pub fn properties_of(&self, type_row: u32) -> Vec<u32> {
        let Some(index) = self
            .property_map
            .iter()
            .position(|map| map.parent == type_row)
        else {
            return Vec::new();
        };
        let next = self.property_map.get(index + 1).map(|next| next.property_list);
        run(
            self.property_map[index].property_list,
            next,
            self.property.len(),
            &self.property_ptr,
        )
    }
}
