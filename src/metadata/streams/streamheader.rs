use crate::{
    file::io::{read_le, write_le},
    Error::OutOfBounds,
    Result,
};

/// Stream names the metadata root may declare.
pub const STREAM_NAMES: [&str; 6] = ["#Strings", "#US", "#Blob", "#GUID", "#~", "#-"];

/// A stream header of the metadata root (ECMA-335 II.24.2.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHeader {
    /// Offset of the stream, relative to the metadata root
    pub offset: u32,
    /// Size of the stream in bytes
    pub size: u32,
    /// Name of the stream
    pub name: String,
}

impl StreamHeader {
    /// Reads a stream header from the start of `data`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for truncated data and [`crate::Error::Malformed`]
    /// for unknown stream names.
    pub fn from(data: &[u8]) -> Result<StreamHeader> {
        if data.len() < 9 {
            return Err(OutOfBounds);
        }

        let name_bytes = &data[8..std::cmp::min(data.len(), 8 + 32)];
        let Some(end) = name_bytes.iter().position(|byte| *byte == 0) else {
            return Err(malformed_error!("Unterminated stream header name"));
        };
        let name = String::from_utf8_lossy(&name_bytes[..end]).into_owned();

        if !STREAM_NAMES.iter().any(|valid_name| name == *valid_name) {
            return Err(malformed_error!("Invalid stream header name - {}", name));
        }

        Ok(StreamHeader {
            offset: read_le::<u32>(data)?,
            size: read_le::<u32>(&data[4..])?,
            name,
        })
    }

    /// Size of this header on disk, including the padded name.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        8 + ((self.name.len() + 1 + 3) & !3)
    }

    /// Appends this header to `buffer`.
    pub fn write(&self, buffer: &mut Vec<u8>) {
        write_le(buffer, self.offset);
        write_le(buffer, self.size);
        buffer.extend_from_slice(self.name.as_bytes());
        buffer.resize(buffer.len() + (self.encoded_len() - 8 - self.name.len()), 0);
    }
}
