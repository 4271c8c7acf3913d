//! Decodes the metadata image of a module into [`MetadataTables`].

use crate::{
    metadata::{
        root::Root,
        streams::TablesHeader,
        tables::{
            codec::{Heaps, RowReader, TableRow},
            MetadataTables, TableId,
        },
    },
    Result,
};

/// The result of reading a metadata image.
pub struct ReadMetadata {
    /// Runtime version string of the metadata root
    pub version: String,
    /// Decoded tables
    pub tables: MetadataTables,
}

fn stream<'a>(root: &Root, data: &'a [u8], name: &str) -> Option<&'a [u8]> {
    let header = root.stream(name)?;
    data.get(header.offset as usize..(header.offset + header.size) as usize)
}

fn read_rows<T: TableRow>(header: &TablesHeader<'_>, heaps: &Heaps<'_>) -> Result<Vec<T>> {
    let count = header.rows(T::TABLE);
    let mut rows = Vec::with_capacity(count as usize);
    for index in 1..=count {
        let values = header.row(T::TABLE, index)?;
        rows.push(T::read(&mut RowReader::new(&values, heaps, &header.info))?);
    }
    Ok(rows)
}

fn read_ptr(header: &TablesHeader<'_>, table: TableId) -> Result<Vec<u32>> {
    (1..=header.rows(table))
        .map(|index| Ok(header.row(table, index)?[0]))
        .collect()
}

/// Reads the metadata root, its heaps and tables from `data`.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if the image has no table stream or any structure in it is
/// damaged, and [`crate::Error::OutOfBounds`] for truncated data.
pub fn read_metadata(data: &[u8]) -> Result<ReadMetadata> {
    let root = Root::read(data)?;

    let Some(table_stream) = stream(&root, data, "#~").or_else(|| stream(&root, data, "#-")) else {
        return Err(malformed_error!("Metadata does not contain a table stream"));
    };

    let heaps = Heaps::new(
        stream(&root, data, "#Strings"),
        stream(&root, data, "#Blob"),
        stream(&root, data, "#GUID"),
    )?;
    let header = TablesHeader::from(table_stream)?;

    let tables = MetadataTables {
        module: read_rows(&header, &heaps)?,
        type_ref: read_rows(&header, &heaps)?,
        type_def: read_rows(&header, &heaps)?,
        field_ptr: read_ptr(&header, TableId::FieldPtr)?,
        field: read_rows(&header, &heaps)?,
        method_ptr: read_ptr(&header, TableId::MethodPtr)?,
        method_def: read_rows(&header, &heaps)?,
        param_ptr: read_ptr(&header, TableId::ParamPtr)?,
        param: read_rows(&header, &heaps)?,
        interface_impl: read_rows(&header, &heaps)?,
        member_ref: read_rows(&header, &heaps)?,
        constant: read_rows(&header, &heaps)?,
        custom_attribute: read_rows(&header, &heaps)?,
        event_map: read_rows(&header, &heaps)?,
        event_ptr: read_ptr(&header, TableId::EventPtr)?,
        event: read_rows(&header, &heaps)?,
        property_map: read_rows(&header, &heaps)?,
        property_ptr: read_ptr(&header, TableId::PropertyPtr)?,
        property: read_rows(&header, &heaps)?,
        method_semantics: read_rows(&header, &heaps)?,
        method_impl: read_rows(&header, &heaps)?,
        module_ref: read_rows(&header, &heaps)?,
        type_spec: read_rows(&header, &heaps)?,
        assembly: read_rows(&header, &heaps)?,
        assembly_ref: read_rows(&header, &heaps)?,
        nested_class: read_rows(&header, &heaps)?,
        generic_param: read_rows(&header, &heaps)?,
        method_spec: read_rows(&header, &heaps)?,
        generic_param_constraint: read_rows(&header, &heaps)?,
    };

    if tables.module.is_empty() {
        return Err(malformed_error!("Metadata does not contain a Module row"));
    }

    Ok(ReadMetadata {
        version: root.version,
        tables,
    })
}
