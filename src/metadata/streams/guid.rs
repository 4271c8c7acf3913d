use crate::{Error::OutOfBounds, Result};

/// The `#GUID` heap: a one-based array of 16 byte GUIDs (ECMA-335 II.24.2.5).
pub struct Guid<'a> {
    data: &'a [u8],
}

impl<'a> Guid<'a> {
    /// Wraps the raw heap bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the heap is not a whole number of GUIDs.
    pub fn from(data: &'a [u8]) -> Result<Guid<'a>> {
        if data.len() % 16 != 0 {
            return Err(malformed_error!("Data for #Guid heap is not a multiple of 16"));
        }

        Ok(Guid { data })
    }

    /// Returns the GUID at the one-based `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for index 0 or indexes past the heap.
    pub fn get(&self, index: usize) -> Result<uguid::Guid> {
        if index < 1 || index * 16 > self.data.len() {
            return Err(OutOfBounds);
        }

        let offset_start = (index - 1) * 16;
        let mut buffer = [0u8; 16];
        buffer.copy_from_slice(&self.data[offset_start..offset_start + 16]);

        Ok(uguid::Guid::from_bytes(buffer))
    }
}

/// Accumulates a `#GUID` heap.
#[derive(Debug, Default)]
pub struct GuidBuilder {
    data: Vec<u8>,
}

impl GuidBuilder {
    /// Creates an empty heap.
    #[must_use]
    pub fn new() -> Self {
        GuidBuilder::default()
    }

    /// Appends `guid` and returns its one-based index.
    pub fn add(&mut self, guid: uguid::Guid) -> u32 {
        self.data.extend_from_slice(&guid.to_bytes());
        #[allow(clippy::cast_possible_truncation)]
        let index = (self.data.len() / 16) as u32;
        index
    }

    /// Returns the heap bytes.
    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        self.data
    }
}
