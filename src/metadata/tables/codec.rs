//! Conversion between raw column values and decoded rows.
//!
//! The table stream stores every column as a 2 or 4 byte integer. [`TableRow`] implementations
//! walk those integers in schema order through a [`RowReader`] (resolving heap indexes and coded
//! indexes on the way) and produce them again through a [`RowWriter`] (interning heap values).

use crate::{
    metadata::{
        streams::{Blob, BlobBuilder, Guid, GuidBuilder, Strings, StringsBuilder},
        tables::{CodedIndexType, TableId, TableInfo},
        token::Token,
    },
    Result,
};

const EMPTY_HEAP: [u8; 1] = [0];

/// The heaps a table stream points into.
pub struct Heaps<'a> {
    strings: Strings<'a>,
    blob: Blob<'a>,
    guid: Option<Guid<'a>>,
}

impl<'a> Heaps<'a> {
    /// Wraps the raw heap streams; absent heaps behave as empty.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if a heap is structurally invalid.
    pub fn new(
        strings: Option<&'a [u8]>,
        blob: Option<&'a [u8]>,
        guid: Option<&'a [u8]>,
    ) -> Result<Self> {
        Ok(Heaps {
            strings: Strings::from(strings.unwrap_or(&EMPTY_HEAP))?,
            blob: Blob::from(blob.unwrap_or(&EMPTY_HEAP))?,
            guid: guid.map(Guid::from).transpose()?,
        })
    }
}

/// Accumulates the heaps while rows are written.
#[derive(Debug, Default)]
pub struct HeapsBuilder {
    /// `#Strings`
    pub strings: StringsBuilder,
    /// `#Blob`
    pub blob: BlobBuilder,
    /// `#GUID`
    pub guid: GuidBuilder,
}

/// Cursor over the raw column values of one row.
pub struct RowReader<'r, 'h> {
    values: &'r [u32],
    next: usize,
    heaps: &'r Heaps<'h>,
    info: &'r TableInfo,
}

impl<'r, 'h> RowReader<'r, 'h> {
    /// Creates a cursor at the first column of `values`.
    #[must_use]
    pub fn new(values: &'r [u32], heaps: &'r Heaps<'h>, info: &'r TableInfo) -> Self {
        RowReader {
            values,
            next: 0,
            heaps,
            info,
        }
    }

    fn take(&mut self) -> u32 {
        let value = self.values.get(self.next).copied().unwrap_or(0);
        self.next += 1;
        value
    }

    /// A constant column.
    pub fn fixed(&mut self) -> u32 {
        self.take()
    }

    /// A simple index into another table.
    pub fn index(&mut self) -> u32 {
        self.take()
    }

    /// A `#Strings` column.
    ///
    /// # Errors
    /// Returns an error if the index does not point at a valid string.
    pub fn string(&mut self) -> Result<String> {
        let index = self.take() as usize;
        Ok(self.heaps.strings.get(index)?.to_string())
    }

    /// A `#Blob` column.
    ///
    /// # Errors
    /// Returns an error if the index does not point at a valid blob.
    pub fn blob(&mut self) -> Result<Vec<u8>> {
        let index = self.take() as usize;
        if index == 0 {
            return Ok(Vec::new());
        }
        Ok(self.heaps.blob.get(index)?.to_vec())
    }

    /// A `#GUID` column; index 0 is the nil GUID.
    ///
    /// # Errors
    /// Returns an error if the index is past the heap.
    pub fn guid(&mut self) -> Result<uguid::Guid> {
        let index = self.take() as usize;
        match (&self.heaps.guid, index) {
            (_, 0) => Ok(uguid::Guid::ZERO),
            (Some(heap), index) => heap.get(index),
            (None, _) => Err(crate::Error::OutOfBounds),
        }
    }

    /// A coded index column, returned as the token it addresses.
    ///
    /// # Errors
    /// Returns an error for reserved tags.
    pub fn coded(&mut self, ci_type: CodedIndexType) -> Result<Token> {
        let value = self.take();
        self.info.decode_coded_index(value, ci_type)
    }
}

/// Collects the raw column values of one row.
pub struct RowWriter<'w> {
    values: Vec<u32>,
    heaps: &'w mut HeapsBuilder,
    info: &'w TableInfo,
}

impl<'w> RowWriter<'w> {
    /// Creates an empty row.
    pub fn new(heaps: &'w mut HeapsBuilder, info: &'w TableInfo) -> Self {
        RowWriter {
            values: Vec::with_capacity(9),
            heaps,
            info,
        }
    }

    /// A constant column.
    pub fn fixed(&mut self, value: u32) {
        self.values.push(value);
    }

    /// A simple index into another table.
    pub fn index(&mut self, row: u32) {
        self.values.push(row);
    }

    /// A `#Strings` column.
    pub fn string(&mut self, value: &str) {
        let index = self.heaps.strings.add(value);
        self.values.push(index);
    }

    /// A `#Blob` column.
    pub fn blob(&mut self, value: &[u8]) {
        let index = self.heaps.blob.add(value);
        self.values.push(index);
    }

    /// A `#GUID` column; the nil GUID is written as index 0.
    pub fn guid(&mut self, value: uguid::Guid) {
        let index = if value == uguid::Guid::ZERO {
            0
        } else {
            self.heaps.guid.add(value)
        };
        self.values.push(index);
    }

    /// A coded index column.
    ///
    /// # Errors
    /// Returns an error if `token` can not be addressed by `ci_type`.
    pub fn coded(&mut self, token: Token, ci_type: CodedIndexType) -> Result<()> {
        let value = self.info.encode_coded_index(token, ci_type)?;
        self.values.push(value);
        Ok(())
    }

    /// The collected values.
    #[must_use]
    pub fn finish(self) -> Vec<u32> {
        self.values
    }
}

/// A decoded row of one table.
pub trait TableRow: Sized {
    /// The table these rows live in
    const TABLE: TableId;

    /// Decodes a row from its column values.
    ///
    /// # Errors
    /// Returns an error if a heap or coded index is invalid.
    fn read(row: &mut RowReader<'_, '_>) -> Result<Self>;

    /// Encodes the row into column values.
    ///
    /// # Errors
    /// Returns an error if a token can not be encoded.
    fn write(&self, row: &mut RowWriter<'_>) -> Result<()>;
}
