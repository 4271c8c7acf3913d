//! Column layouts of every table in ECMA-335 II.22.

use crate::metadata::tables::{CodedIndexType, TableId};

/// The kind of a single table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    /// A constant of the given width in bytes
    Fixed(usize),
    /// An index into `#Strings`
    String,
    /// An index into `#GUID`
    Guid,
    /// An index into `#Blob`
    Blob,
    /// A simple index into another table
    Index(TableId),
    /// A coded index into one of several tables
    Coded(CodedIndexType),
}

use CodedIndexType as C;
use Column::{Blob, Coded, Fixed, Guid, Index, String};

/// Returns the columns of `table`, in on-disk order.
#[must_use]
pub fn columns(table: TableId) -> &'static [Column] {
    match table {
        TableId::Module => &[Fixed(2), String, Guid, Guid, Guid],
        TableId::TypeRef => &[Coded(C::ResolutionScope), String, String],
        TableId::TypeDef => &[
            Fixed(4),
            String,
            String,
            Coded(C::TypeDefOrRef),
            Index(TableId::Field),
            Index(TableId::MethodDef),
        ],
        TableId::FieldPtr => &[Index(TableId::Field)],
        TableId::Field => &[Fixed(2), String, Blob],
        TableId::MethodPtr => &[Index(TableId::MethodDef)],
        TableId::MethodDef => &[Fixed(4), Fixed(2), Fixed(2), String, Blob, Index(TableId::Param)],
        TableId::ParamPtr => &[Index(TableId::Param)],
        TableId::Param => &[Fixed(2), Fixed(2), String],
        TableId::InterfaceImpl => &[Index(TableId::TypeDef), Coded(C::TypeDefOrRef)],
        TableId::MemberRef => &[Coded(C::MemberRefParent), String, Blob],
        // Type is a single byte followed by a padding byte
        TableId::Constant => &[Fixed(2), Coded(C::HasConstant), Blob],
        TableId::CustomAttribute => &[
            Coded(C::HasCustomAttribute),
            Coded(C::CustomAttributeType),
            Blob,
        ],
        TableId::FieldMarshal => &[Coded(C::HasFieldMarshal), Blob],
        TableId::DeclSecurity => &[Fixed(2), Coded(C::HasDeclSecurity), Blob],
        TableId::ClassLayout => &[Fixed(2), Fixed(4), Index(TableId::TypeDef)],
        TableId::FieldLayout => &[Fixed(4), Index(TableId::Field)],
        TableId::StandAloneSig => &[Blob],
        TableId::EventMap => &[Index(TableId::TypeDef), Index(TableId::Event)],
        TableId::EventPtr => &[Index(TableId::Event)],
        TableId::Event => &[Fixed(2), String, Coded(C::TypeDefOrRef)],
        TableId::PropertyMap => &[Index(TableId::TypeDef), Index(TableId::Property)],
        TableId::PropertyPtr => &[Index(TableId::Property)],
        TableId::Property => &[Fixed(2), String, Blob],
        TableId::MethodSemantics => &[
            Fixed(2),
            Index(TableId::MethodDef),
            Coded(C::HasSemantics),
        ],
        TableId::MethodImpl => &[
            Index(TableId::TypeDef),
            Coded(C::MethodDefOrRef),
            Coded(C::MethodDefOrRef),
        ],
        TableId::ModuleRef => &[String],
        TableId::TypeSpec => &[Blob],
        TableId::ImplMap => &[
            Fixed(2),
            Coded(C::MemberForwarded),
            String,
            Index(TableId::ModuleRef),
        ],
        TableId::FieldRVA => &[Fixed(4), Index(TableId::Field)],
        TableId::EncLog => &[Fixed(4), Fixed(4)],
        TableId::EncMap => &[Fixed(4)],
        TableId::Assembly => &[
            Fixed(4),
            Fixed(2),
            Fixed(2),
            Fixed(2),
            Fixed(2),
            Fixed(4),
            Blob,
            String,
            String,
        ],
        TableId::AssemblyProcessor => &[Fixed(4)],
        TableId::AssemblyOS => &[Fixed(4), Fixed(4), Fixed(4)],
        TableId::AssemblyRef => &[
            Fixed(2),
            Fixed(2),
            Fixed(2),
            Fixed(2),
            Fixed(4),
            Blob,
            String,
            String,
            Blob,
        ],
        TableId::AssemblyRefProcessor => &[Fixed(4), Index(TableId::AssemblyRef)],
        TableId::AssemblyRefOS => &[Fixed(4), Fixed(4), Fixed(4), Index(TableId::AssemblyRef)],
        TableId::File => &[Fixed(4), String, Blob],
        TableId::ExportedType => &[
            Fixed(4),
            Fixed(4),
            String,
            String,
            Coded(C::Implementation),
        ],
        TableId::ManifestResource => &[Fixed(4), Fixed(4), String, Coded(C::Implementation)],
        TableId::NestedClass => &[Index(TableId::TypeDef), Index(TableId::TypeDef)],
        TableId::GenericParam => &[Fixed(2), Fixed(2), Coded(C::TypeOrMethodDef), String],
        TableId::MethodSpec => &[Coded(C::MethodDefOrRef), Blob],
        TableId::GenericParamConstraint => &[
            Index(TableId::GenericParam),
            Coded(C::TypeDefOrRef),
        ],
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;
    use crate::metadata::tables::TableInfo;

    #[test]
    fn every_table_has_columns() {
        for table in TableId::iter() {
            assert!(!columns(table).is_empty(), "{:?}", table);
        }
    }

    #[test]
    fn minimal_row_sizes() {
        let info = TableInfo::default();

        assert_eq!(info.row_size(TableId::Module), 10);
        assert_eq!(info.row_size(TableId::TypeDef), 14);
        assert_eq!(info.row_size(TableId::MethodDef), 14);
        assert_eq!(info.row_size(TableId::Assembly), 22);
        assert_eq!(info.row_size(TableId::AssemblyRef), 20);
        assert_eq!(info.row_size(TableId::GenericParam), 8);
    }
}
