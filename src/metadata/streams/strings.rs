use std::{collections::HashMap, ffi::CStr};

use crate::{Error::OutOfBounds, Result};

/// The `#Strings` heap: null-terminated UTF-8 identifiers (ECMA-335 II.24.2.3).
pub struct Strings<'a> {
    data: &'a [u8],
}

impl<'a> Strings<'a> {
    /// Wraps the raw heap bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the heap does not start with the empty string.
    pub fn from(data: &'a [u8]) -> Result<Strings<'a>> {
        if data.is_empty() || data[0] != 0 {
            return Err(malformed_error!("Provided #String heap is empty"));
        }

        Ok(Strings { data })
    }

    /// Returns the string starting at `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] or [`crate::Error::Malformed`] for bad indexes.
    pub fn get(&self, index: usize) -> Result<&'a str> {
        if index >= self.data.len() {
            return Err(OutOfBounds);
        }

        match CStr::from_bytes_until_nul(&self.data[index..]) {
            Ok(result) => match result.to_str() {
                Ok(result) => Ok(result),
                Err(_) => Err(malformed_error!("Invalid string at index - {}", index)),
            },
            Err(_) => Err(malformed_error!("Invalid string at index - {}", index)),
        }
    }
}

/// Accumulates a de-duplicated `#Strings` heap.
#[derive(Debug)]
pub struct StringsBuilder {
    data: Vec<u8>,
    offsets: HashMap<String, u32>,
}

impl StringsBuilder {
    /// Creates a heap holding only the empty string.
    #[must_use]
    pub fn new() -> Self {
        StringsBuilder {
            data: vec![0],
            offsets: HashMap::new(),
        }
    }

    /// Interns `value` and returns its heap index.
    pub fn add(&mut self, value: &str) -> u32 {
        if value.is_empty() {
            return 0;
        }
        if let Some(offset) = self.offsets.get(value) {
            return *offset;
        }

        #[allow(clippy::cast_possible_truncation)]
        let offset = self.data.len() as u32;
        self.data.extend_from_slice(value.as_bytes());
        self.data.push(0);
        self.offsets.insert(value.to_string(), offset);
        offset
    }

    /// Returns the heap padded to a 4 byte boundary.
    #[must_use]
    pub fn finish(mut self) -> Vec<u8> {
        self.data.resize((self.data.len() + 3) & !3, 0);
        self.data
    }
}

impl Default for StringsBuilder {
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
            0x3c, 0x4d, 0x61, 0x69, 0x6e, 0x3e, 0x24, 0x00,
            0x53, 0x79, 0x73, 0x74, 0x65, 0x6d, 0x00,
        ];

        let strings = Strings::from(&data).unwrap();

        assert_eq!(strings.get(0).unwrap(), "");
        assert_eq!(strings.get(1).unwrap(), "<Main>$");
        assert_eq!(strings.get(9).unwrap(), "System");
        assert_eq!(strings.get(12).unwrap(), "tem");
        assert!(strings.get(data.len()).is_err());
    }

    #[test]
    fn builder_deduplicates() {
        let mut builder = StringsBuilder::new();
        let object = builder.add("Object");
        let system = builder.add("System");

        assert_eq!(builder.add("Object"), object);
        assert_eq!(builder.add(""), 0);

        let heap = builder.finish();
        assert_eq!(heap.len() % 4, 0);

        let strings = Strings::from(&heap).unwrap();
        assert_eq!(strings.get(object as usize).unwrap(), "Object");
        assert_eq!(strings.get(system as usize).unwrap(), "System");
    }
}
