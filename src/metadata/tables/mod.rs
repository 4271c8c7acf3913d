//! Metadata tables (ECMA-335 II.22).
//!
//! The layer is split the same way the on-disk format is:
//!
//! - [`TableId`], [`CodedIndexType`] and [`TableInfo`] describe the table set and how wide each
//!   index column is for a particular module
//! - [`schema`] lists the column layout of every table, so any valid module can be walked even
//!   when the model only consumes a subset of its tables
//! - [`rows`] holds the decoded, heap-resolved rows the rest of the crate works with, and
//!   [`codec`] converts them from and to raw column values
//! - [`reader`] and [`writer`] convert between the raw table stream and [`rows::MetadataTables`]

pub mod codec;
pub mod reader;
pub mod rows;
pub mod schema;
pub mod writer;

pub use rows::*;
pub use schema::Column;

use strum::{EnumCount, EnumIter, IntoEnumIterator};

use crate::{metadata::token::Token, Error::OutOfBounds, Result};

/// Identifiers of the metadata tables, valued by their table number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, EnumCount)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum TableId {
    Module = 0x00,
    TypeRef = 0x01,
    TypeDef = 0x02,
    FieldPtr = 0x03,
    Field = 0x04,
    MethodPtr = 0x05,
    MethodDef = 0x06,
    ParamPtr = 0x07,
    Param = 0x08,
    InterfaceImpl = 0x09,
    MemberRef = 0x0A,
    Constant = 0x0B,
    CustomAttribute = 0x0C,
    FieldMarshal = 0x0D,
    DeclSecurity = 0x0E,
    ClassLayout = 0x0F,
    FieldLayout = 0x10,
    StandAloneSig = 0x11,
    EventMap = 0x12,
    EventPtr = 0x13,
    Event = 0x14,
    PropertyMap = 0x15,
    PropertyPtr = 0x16,
    Property = 0x17,
    MethodSemantics = 0x18,
    MethodImpl = 0x19,
    ModuleRef = 0x1A,
    TypeSpec = 0x1B,
    ImplMap = 0x1C,
    FieldRVA = 0x1D,
    EncLog = 0x1E,
    EncMap = 0x1F,
    Assembly = 0x20,
    AssemblyProcessor = 0x21,
    AssemblyOS = 0x22,
    AssemblyRef = 0x23,
    AssemblyRefProcessor = 0x24,
    AssemblyRefOS = 0x25,
    File = 0x26,
    ExportedType = 0x27,
    ManifestResource = 0x28,
    NestedClass = 0x29,
    GenericParam = 0x2A,
    MethodSpec = 0x2B,
    GenericParamConstraint = 0x2C,
}

impl TableId {
    /// Maps a table number back to its identifier.
    #[must_use]
    pub fn from_u8(value: u8) -> Option<TableId> {
        TableId::iter().find(|id| *id as u8 == value)
    }
}

/// The coded index kinds of ECMA-335 II.24.2.6.
#[derive(Debug, Hash, Eq, PartialEq, Clone, Copy, EnumIter, EnumCount)]
#[repr(usize)]
#[allow(missing_docs)]
pub enum CodedIndexType {
    TypeDefOrRef,
    HasConstant,
    HasCustomAttribute,
    HasFieldMarshal,
    HasDeclSecurity,
    MemberRefParent,
    HasSemantics,
    MethodDefOrRef,
    MemberForwarded,
    Implementation,
    CustomAttributeType,
    ResolutionScope,
    TypeOrMethodDef,
}

impl CodedIndexType {
    /// Tables addressable by this coded index, in tag order. `None` marks reserved tags.
    #[must_use]
    pub fn tables(&self) -> &'static [Option<TableId>] {
        match self {
            CodedIndexType::TypeDefOrRef => &[
                Some(TableId::TypeDef),
                Some(TableId::TypeRef),
                Some(TableId::TypeSpec),
            ],
            CodedIndexType::HasConstant => &[
                Some(TableId::Field),
                Some(TableId::Param),
                Some(TableId::Property),
            ],
            CodedIndexType::HasCustomAttribute => &[
                Some(TableId::MethodDef),
                Some(TableId::Field),
                Some(TableId::TypeRef),
                Some(TableId::TypeDef),
                Some(TableId::Param),
                Some(TableId::InterfaceImpl),
                Some(TableId::MemberRef),
                Some(TableId::Module),
                Some(TableId::DeclSecurity),
                Some(TableId::Property),
                Some(TableId::Event),
                Some(TableId::StandAloneSig),
                Some(TableId::ModuleRef),
                Some(TableId::TypeSpec),
                Some(TableId::Assembly),
                Some(TableId::AssemblyRef),
                Some(TableId::File),
                Some(TableId::ExportedType),
                Some(TableId::ManifestResource),
                Some(TableId::GenericParam),
                Some(TableId::GenericParamConstraint),
                Some(TableId::MethodSpec),
            ],
            CodedIndexType::HasFieldMarshal => &[Some(TableId::Field), Some(TableId::Param)],
            CodedIndexType::HasDeclSecurity => &[
                Some(TableId::TypeDef),
                Some(TableId::MethodDef),
                Some(TableId::Assembly),
            ],
            CodedIndexType::MemberRefParent => &[
                Some(TableId::TypeDef),
                Some(TableId::TypeRef),
                Some(TableId::ModuleRef),
                Some(TableId::MethodDef),
                Some(TableId::TypeSpec),
            ],
            CodedIndexType::HasSemantics => &[Some(TableId::Event), Some(TableId::Property)],
            CodedIndexType::MethodDefOrRef => &[Some(TableId::MethodDef), Some(TableId::MemberRef)],
            CodedIndexType::MemberForwarded => &[Some(TableId::Field), Some(TableId::MethodDef)],
            CodedIndexType::Implementation => &[
                Some(TableId::File),
                Some(TableId::AssemblyRef),
                Some(TableId::ExportedType),
            ],
            CodedIndexType::CustomAttributeType => &[
                None,
                None,
                Some(TableId::MethodDef),
                Some(TableId::MemberRef),
                None,
            ],
            CodedIndexType::ResolutionScope => &[
                Some(TableId::Module),
                Some(TableId::ModuleRef),
                Some(TableId::AssemblyRef),
                Some(TableId::TypeRef),
            ],
            CodedIndexType::TypeOrMethodDef => &[Some(TableId::TypeDef), Some(TableId::MethodDef)],
        }
    }

    /// Number of low bits that carry the tag.
    #[must_use]
    pub fn tag_bits(&self) -> u32 {
        let count = self.tables().len() as u32;
        u32::BITS - (count - 1).leading_zeros()
    }
}

/// Row counts and index widths of one module's table stream.
#[derive(Clone, Debug)]
pub struct TableInfo {
    rows: [u32; TableId::COUNT],
    is_large_index_str: bool,
    is_large_index_guid: bool,
    is_large_index_blob: bool,
}

impl Default for TableInfo {
    fn default() -> Self {
        TableInfo::new([0; TableId::COUNT], 0)
    }
}

impl TableInfo {
    /// Creates the index layout for the given row counts and heap size flags.
    #[must_use]
    pub fn new(rows: [u32; TableId::COUNT], heap_sizes: u8) -> Self {
        TableInfo {
            rows,
            is_large_index_str: heap_sizes & 1 == 1,
            is_large_index_guid: heap_sizes & 2 == 2,
            is_large_index_blob: heap_sizes & 4 == 4,
        }
    }

    /// Heap size flags as written into the table stream header.
    #[must_use]
    pub fn heap_sizes(&self) -> u8 {
        u8::from(self.is_large_index_str)
            | (u8::from(self.is_large_index_guid) << 1)
            | (u8::from(self.is_large_index_blob) << 2)
    }

    /// Number of rows in `id`.
    #[must_use]
    pub fn rows(&self, id: TableId) -> u32 {
        self.rows[id as usize]
    }

    /// Returns true if simple indexes into `id` take 4 bytes.
    #[must_use]
    pub fn is_large(&self, id: TableId) -> bool {
        self.rows(id) > u32::from(u16::MAX)
    }

    /// Returns true if `#Strings` indexes take 4 bytes.
    #[must_use]
    pub fn is_large_str(&self) -> bool {
        self.is_large_index_str
    }

    /// Returns true if `#GUID` indexes take 4 bytes.
    #[must_use]
    pub fn is_large_guid(&self) -> bool {
        self.is_large_index_guid
    }

    /// Returns true if `#Blob` indexes take 4 bytes.
    #[must_use]
    pub fn is_large_blob(&self) -> bool {
        self.is_large_index_blob
    }

    /// Returns true if coded indexes of `ci_type` take 4 bytes.
    #[must_use]
    pub fn is_large_coded(&self, ci_type: CodedIndexType) -> bool {
        let max_rows = ci_type
            .tables()
            .iter()
            .flatten()
            .map(|table| self.rows(*table))
            .max()
            .unwrap_or(0);

        u64::from(max_rows) >= (1_u64 << (16 - ci_type.tag_bits()))
    }

    /// Width in bytes of `column` under this layout.
    #[must_use]
    pub fn column_size(&self, column: Column) -> usize {
        let large = match column {
            Column::Fixed(size) => return size,
            Column::String => self.is_large_index_str,
            Column::Guid => self.is_large_index_guid,
            Column::Blob => self.is_large_index_blob,
            Column::Index(table) => self.is_large(table),
            Column::Coded(ci_type) => self.is_large_coded(ci_type),
        };

        if large {
            4
        } else {
            2
        }
    }

    /// Width in bytes of a row of `id`.
    #[must_use]
    pub fn row_size(&self, id: TableId) -> usize {
        schema::columns(id)
            .iter()
            .map(|column| self.column_size(*column))
            .sum()
    }

    /// Splits a coded index value into the token it addresses; row 0 yields the null token.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for reserved or unknown tags.
    pub fn decode_coded_index(&self, value: u32, ci_type: CodedIndexType) -> Result<Token> {
        let tag_bits = ci_type.tag_bits();
        let tag = value & ((1 << tag_bits) - 1);
        let row = value >> tag_bits;

        match ci_type.tables().get(tag as usize) {
            Some(Some(_)) if row == 0 => Ok(Token::new(0)),
            Some(Some(table)) => Ok(Token::from_parts(*table, row)),
            _ => Err(OutOfBounds),
        }
    }

    /// Packs `token` into a coded index value.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the token's table is not addressable by `ci_type`.
    pub fn encode_coded_index(&self, token: Token, ci_type: CodedIndexType) -> Result<u32> {
        if token.value() == 0 {
            return Ok(0);
        }

        let Some(tag) = ci_type
            .tables()
            .iter()
            .position(|table| table.is_some() && *table == token.table_id())
        else {
            return Err(malformed_error!(
                "Token {} can not be encoded as {:?}",
                token,
                ci_type
            ));
        };

        Ok((token.row() << ci_type.tag_bits()) | tag as u32)
    }
}
