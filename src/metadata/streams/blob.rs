use std::collections::HashMap;

use crate::{
    file::parser::Parser, metadata::signatures::write_compressed_uint, Error::OutOfBounds, Result,
};

/// The `#Blob` heap: length-prefixed binary values such as signatures (ECMA-335 II.24.2.4).
pub struct Blob<'a> {
    data: &'a [u8],
}

impl<'a> Blob<'a> {
    /// Wraps the raw heap bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the heap does not start with the empty blob.
    pub fn from(data: &'a [u8]) -> Result<Blob<'a>> {
        if data.is_empty() || data[0] != 0 {
            return Err(malformed_error!("Invalid memory for #Blob heap"));
        }

        Ok(Blob { data })
    }

    /// Returns the blob starting at `index`, without its length prefix.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the blob does not fit into the heap.
    pub fn get(&self, index: usize) -> Result<&'a [u8]> {
        if index >= self.data.len() {
            return Err(OutOfBounds);
        }

        let mut parser = Parser::new(&self.data[index..]);
        let len = parser.read_compressed_uint()? as usize;
        let skip = parser.pos();

        let Some(data_start) = index.checked_add(skip) else {
            return Err(OutOfBounds);
        };

        let Some(data_end) = data_start.checked_add(len) else {
            return Err(OutOfBounds);
        };

        if data_end > self.data.len() {
            return Err(OutOfBounds);
        }

        Ok(&self.data[data_start..data_end])
    }
}

/// Accumulates a de-duplicated `#Blob` heap.
#[derive(Debug)]
pub struct BlobBuilder {
    data: Vec<u8>,
    offsets: HashMap<Vec<u8>, u32>,
}

impl BlobBuilder {
    /// Creates a heap holding only the empty blob.
    #[must_use]
    pub fn new() -> Self {
        BlobBuilder {
            data: vec![0],
            offsets: HashMap::new(),
        }
    }

    /// Interns `value` and returns its heap index.
    pub fn add(&mut self, value: &[u8]) -> u32 {
        if value.is_empty() {
            return 0;
        }
        if let Some(offset) = self.offsets.get(value) {
            return *offset;
        }

        #[allow(clippy::cast_possible_truncation)]
        let offset = self.data.len() as u32;
        #[allow(clippy::cast_possible_truncation)]
        write_compressed_uint(value.len() as u32, &mut self.data);
        self.data.extend_from_slice(value);
        self.offsets.insert(value.to_vec(), offset);
        offset
    }

    /// Returns the heap padded to a 4 byte boundary.
    #[must_use]
    pub fn finish(mut self) -> Vec<u8> {
        self.data.resize((self.data.len() + 3) & !3, 0);
        self.data
    }
}

impl Default for BlobBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crafted() {
        #[rustfmt::skip]
        let data = [
            0x00,
            0x03, 0x20, 0x00, 0x01,
            0x02, 0x06, 0x08,
            0x05, 0x01,
        ];

        let blob = Blob::from(&data).unwrap();

        assert_eq!(blob.get(0).unwrap(), &[] as &[u8]);
        assert_eq!(blob.get(1).unwrap(), &[0x20, 0x00, 0x01]);
        assert_eq!(blob.get(5).unwrap(), &[0x06, 0x08]);
        assert!(blob.get(8).is_err());
    }

    #[test]
    fn builder_deduplicates() {
        let mut builder = BlobBuilder::new();
        let first = builder.add(&[0x06, 0x08]);
        let second = builder.add(&[0x20, 0x00, 0x01]);

        assert_eq!(builder.add(&[0x06, 0x08]), first);
        assert_eq!(builder.add(&[]), 0);

        let heap = builder.finish();
        let blob = Blob::from(&heap).unwrap();
        assert_eq!(blob.get(first as usize).unwrap(), &[0x06, 0x08]);
        assert_eq!(blob.get(second as usize).unwrap(), &[0x20, 0x00, 0x01]);
    }

    #[test]
    fn builder_two_byte_lengths() {
        let long = vec![0xAB_u8; 300];
        let mut builder = BlobBuilder::new();
        let index = builder.add(&long);

        let heap = builder.finish();
        assert_eq!(&heap[1..3], &[0x81, 0x2C]);
        let blob = Blob::from(&heap).unwrap();
        assert_eq!(blob.get(index as usize).unwrap(), long.as_slice());
    }
}
