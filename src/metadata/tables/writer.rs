//! Serialises [`MetadataTables`] into a bare metadata image.
//!
//! The image is a metadata root followed by the `#~`, `#Strings`, `#Blob` and `#GUID` streams.
//! Rows are written in the order they are stored; heap and index widths are computed from the
//! final heap sizes and row counts.

use crate::{
    file::io::{write_le, write_le_dyn},
    metadata::{
        root::Root,
        tables::{
            codec::{HeapsBuilder, RowWriter, TableRow},
            schema, Column, MetadataTables, TableId, TableInfo,
        },
    },
    Result,
};

/// Tables whose rows have to be sorted by their primary key column
const SORTED_TABLES: [TableId; 8] = [
    TableId::InterfaceImpl,
    TableId::Constant,
    TableId::CustomAttribute,
    TableId::MethodSemantics,
    TableId::MethodImpl,
    TableId::NestedClass,
    TableId::GenericParam,
    TableId::GenericParamConstraint,
];

struct RawTables {
    rows: Vec<(TableId, Vec<Vec<u32>>)>,
}

impl RawTables {
    fn add<T: TableRow>(
        &mut self,
        rows: &[T],
        heaps: &mut HeapsBuilder,
        info: &TableInfo,
    ) -> Result<()> {
        let mut raw = Vec::with_capacity(rows.len());
        for row in rows {
            let mut writer = RowWriter::new(heaps, info);
            row.write(&mut writer)?;
            raw.push(writer.finish());
        }
        self.rows.push((T::TABLE, raw));
        Ok(())
    }

    fn add_ptr(&mut self, table: TableId, rows: &[u32]) {
        self.rows
            .push((table, rows.iter().map(|row| vec![*row]).collect()));
    }
}

/// Writes the tables into a complete metadata image carrying `version` in its root.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if a token can not be encoded in its column, and
/// [`crate::Error::OutOfBounds`] if a value does not fit its column width.
pub fn write_metadata(version: &str, tables: &MetadataTables) -> Result<Vec<u8>> {
    let row_counts = tables.row_counts();
    // Coded index values do not depend on heap sizes, so a provisional layout is enough here
    let provisional = TableInfo::new(row_counts, 0);
    let mut heaps = HeapsBuilder::default();
    let mut raw = RawTables { rows: Vec::new() };

    raw.add(&tables.module, &mut heaps, &provisional)?;
    raw.add(&tables.type_ref, &mut heaps, &provisional)?;
    raw.add(&tables.type_def, &mut heaps, &provisional)?;
    raw.add_ptr(TableId::FieldPtr, &tables.field_ptr);
    raw.add(&tables.field, &mut heaps, &provisional)?;
    raw.add_ptr(TableId::MethodPtr, &tables.method_ptr);
    raw.add(&tables.method_def, &mut heaps, &provisional)?;
    raw.add_ptr(TableId::ParamPtr, &tables.param_ptr);
    raw.add(&tables.param, &mut heaps, &provisional)?;
    raw.add(&tables.interface_impl, &mut heaps, &provisional)?;
    raw.add(&tables.member_ref, &mut heaps, &provisional)?;
    raw.add(&tables.constant, &mut heaps, &provisional)?;
    raw.add(&tables.custom_attribute, &mut heaps, &provisional)?;
    raw.add(&tables.event_map, &mut heaps, &provisional)?;
    raw.add_ptr(TableId::EventPtr, &tables.event_ptr);
    raw.add(&tables.event, &mut heaps, &provisional)?;
    raw.add(&tables.property_map, &mut heaps, &provisional)?;
    raw.add_ptr(TableId::PropertyPtr, &tables.property_ptr);
    raw.add(&tables.property, &mut heaps, &provisional)?;
    raw.add(&tables.method_semantics, &mut heaps, &provisional)?;
    raw.add(&tables.method_impl, &mut heaps, &provisional)?;
    raw.add(&tables.module_ref, &mut heaps, &provisional)?;
    raw.add(&tables.type_spec, &mut heaps, &provisional)?;
    raw.add(&tables.assembly, &mut heaps, &provisional)?;
    raw.add(&tables.assembly_ref, &mut heaps, &provisional)?;
    raw.add(&tables.nested_class, &mut heaps, &provisional)?;
    raw.add(&tables.generic_param, &mut heaps, &provisional)?;
    raw.add(&tables.method_spec, &mut heaps, &provisional)?;
    raw.add(&tables.generic_param_constraint, &mut heaps, &provisional)?;

    let strings = heaps.strings.finish();
    let blob = heaps.blob.finish();
    let guid = heaps.guid.finish();

    let heap_sizes = u8::from(strings.len() > usize::from(u16::MAX))
        | (u8::from(guid.len() / 16 > usize::from(u16::MAX)) << 1)
        | (u8::from(blob.len() > usize::from(u16::MAX)) << 2);
    let info = TableInfo::new(row_counts, heap_sizes);

    let mut valid = 0_u64;
    for (table, rows) in &raw.rows {
        if !rows.is_empty() {
            valid |= 1 << *table as u64;
        }
    }
    let sorted = SORTED_TABLES
        .iter()
        .fold(0_u64, |bits, table| bits | (1 << *table as u64));

    let mut stream = Vec::new();
    write_le(&mut stream, 0_u32);
    write_le(&mut stream, 2_u8);
    write_le(&mut stream, 0_u8);
    write_le(&mut stream, heap_sizes);
    write_le(&mut stream, 1_u8);
    write_le(&mut stream, valid);
    write_le(&mut stream, sorted);

    // Row counts, then rows, both in table number order
    let mut ordered: Vec<&(TableId, Vec<Vec<u32>>)> = raw.rows.iter().collect();
    ordered.sort_by_key(|(table, _)| *table);
    for (table, rows) in &ordered {
        if !rows.is_empty() {
            write_le(&mut stream, info.rows(*table));
        }
    }
    for (table, rows) in &ordered {
        let columns = schema::columns(*table);
        for row in rows {
            for (column, value) in columns.iter().zip(row) {
                match column {
                    Column::Fixed(2) => {
                        write_le_dyn(&mut stream, *value, false)?;
                    }
                    Column::Fixed(_) => write_le(&mut stream, *value),
                    column => {
                        write_le_dyn(&mut stream, *value, info.column_size(*column) == 4)?;
                    }
                }
            }
        }
    }

    Ok(Root::write_image(
        version,
        &[
            ("#~", &stream),
            ("#Strings", &strings),
            ("#Blob", &blob),
            ("#GUID", &guid),
        ],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{
        flags::{GenericParamAttributes, MethodAttributes, TypeAttributes},
        root::DEFAULT_VERSION,
        tables::{reader::read_metadata, GenericParamRow, MethodDefRow, ModuleRow, TypeDefRow},
        token::Token,
    };

    fn tables() -> MetadataTables {
        let mut tables = MetadataTables::default();
        tables.module.push(ModuleRow {
            generation: 0,
            name: "Sample.dll".to_string(),
            mvid: uguid::guid!("01234567-89ab-cdef-0123-456789abcdef"),
        });
        tables.type_def.push(TypeDefRow {
            flags: TypeAttributes::PUBLIC | TypeAttributes::INTERFACE | TypeAttributes::ABSTRACT,
            name: "IBox`1".to_string(),
            namespace: "Sample".to_string(),
            extends: Token::new(0),
            field_list: 1,
            method_list: 1,
        });
        tables.method_def.push(MethodDefRow {
            rva: 0,
            impl_flags: 0,
            flags: MethodAttributes::PUBLIC
                | MethodAttributes::ABSTRACT
                | MethodAttributes::VIRTUAL,
            name: "Get".to_string(),
            signature: vec![0x20, 0x00, 0x13, 0x00],
            param_list: 1,
        });
        tables.generic_param.push(GenericParamRow {
            number: 0,
            flags: GenericParamAttributes::COVARIANT,
            owner: Token::new(0x0200_0001),
            name: "T".to_string(),
        });
        tables
    }

    #[test]
    fn write_then_read() {
        let tables = tables();
        let image = write_metadata(DEFAULT_VERSION, &tables).unwrap();

        let read = read_metadata(&image).unwrap();
        assert_eq!(read.version, DEFAULT_VERSION);
        assert_eq!(read.tables.module, tables.module);
        assert_eq!(read.tables.type_def, tables.type_def);
        assert_eq!(read.tables.method_def, tables.method_def);
        assert_eq!(read.tables.generic_param, tables.generic_param);
        assert!(read.tables.field.is_empty());
        assert_eq!(read.tables.methods_of(1), vec![1]);
    }

    #[test]
    fn missing_module_row() {
        let image = write_metadata(DEFAULT_VERSION, &MetadataTables::default()).unwrap();
        assert!(read_metadata(&image).is_err());
    }

    #[test]
    fn unencodable_token() {
        let mut tables = tables();
        tables.type_def[0].extends = Token::new(0x0600_0001);
        assert!(write_metadata(DEFAULT_VERSION, &tables).is_err());
    }
}
