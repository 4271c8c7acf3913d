//! The `#~` / `#-` table stream header (ECMA-335 II.24.2.6).
//!
//! The header lists which tables are present and how many rows each has; the rows follow back to
//! back in table order. [`TablesHeader`] computes where every table starts and hands out the raw
//! column values of single rows, sized according to the module's [`TableInfo`].

use strum::{EnumCount, IntoEnumIterator};

use crate::{
    file::io::{read_le, read_le_at, read_le_at_dyn},
    metadata::tables::{schema, Column, TableId, TableInfo},
    Error::OutOfBounds,
    Result,
};

/// Heap size flag announcing four extra bytes after the row counts, used by `#-` streams
const EXTRA_DATA: u8 = 0x40;

/// The parsed table stream header, with row offsets resolved.
pub struct TablesHeader<'a> {
    /// Major version of the table schema
    pub major_version: u8,
    /// Minor version of the table schema
    pub minor_version: u8,
    /// Bit vector of present tables
    pub valid: u64,
    /// Bit vector of sorted tables
    pub sorted: u64,
    /// Row counts and index sizes
    pub info: TableInfo,
    data: &'a [u8],
    offsets: [usize; TableId::COUNT],
}

impl<'a> TablesHeader<'a> {
    /// Parses the header at the start of `data`, the table stream.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the declared rows exceed the stream, and
    /// [`crate::Error::Malformed`] for tables outside the known schema.
    pub fn from(data: &'a [u8]) -> Result<TablesHeader<'a>> {
        if data.len() < 24 {
            return Err(OutOfBounds);
        }

        let heap_sizes = read_le::<u8>(&data[6..])?;
        let valid = read_le::<u64>(&data[8..])?;
        let sorted = read_le::<u64>(&data[16..])?;

        if valid >> TableId::COUNT != 0 {
            return Err(malformed_error!(
                "Table stream declares unknown tables - {:#x}",
                valid
            ));
        }

        let mut rows = [0_u32; TableId::COUNT];
        let mut offset = 24_usize;
        for table_id in TableId::iter() {
            if valid & (1 << table_id as u64) != 0 {
                rows[table_id as usize] = read_le_at::<u32>(data, &mut offset)?;
            }
        }
        if heap_sizes & EXTRA_DATA != 0 {
            offset += 4;
        }

        let info = TableInfo::new(rows, heap_sizes);

        let mut offsets = [0_usize; TableId::COUNT];
        for table_id in TableId::iter() {
            offsets[table_id as usize] = offset;
            let size = info.row_size(table_id) * info.rows(table_id) as usize;
            offset = match offset.checked_add(size) {
                Some(end) if end <= data.len() => end,
                _ => return Err(OutOfBounds),
            };
        }

        Ok(TablesHeader {
            major_version: read_le::<u8>(&data[4..])?,
            minor_version: read_le::<u8>(&data[5..])?,
            valid,
            sorted,
            info,
            data,
            offsets,
        })
    }

    /// Number of tables present in the stream
    #[must_use]
    pub fn table_count(&self) -> u32 {
        self.valid.count_ones()
    }

    /// Number of rows of `table_id`
    #[must_use]
    pub fn rows(&self, table_id: TableId) -> u32 {
        self.info.rows(table_id)
    }

    /// Reads the raw column values of the one-based `row` of `table_id`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the row does not exist.
    pub fn row(&self, table_id: TableId, row: u32) -> Result<Vec<u32>> {
        if row == 0 || row > self.rows(table_id) {
            return Err(OutOfBounds);
        }

        let row_size = self.info.row_size(table_id);
        let mut offset = self.offsets[table_id as usize] + (row as usize - 1) * row_size;

        let columns = schema::columns(table_id);
        let mut values = Vec::with_capacity(columns.len());
        for column in columns {
            let value = match column {
                Column::Fixed(2) => u32::from(read_le_at::<u16>(self.data, &mut offset)?),
                Column::Fixed(4) => read_le_at::<u32>(self.data, &mut offset)?,
                Column::Fixed(size) => {
                    return Err(malformed_error!("Unsupported column width - {}", size))
                }
                column => {
                    let is_large = self.info.column_size(*column) == 4;
                    read_le_at_dyn(self.data, &mut offset, is_large)?
                }
            };
            values.push(value);
        }

        Ok(values)
    }
}
