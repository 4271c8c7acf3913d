//! Metadata root header and stream directory (ECMA-335 II.24.2.1).
//!
//! The metadata root is the entry point of every module's metadata: a signature, a version string
//! and the directory of the streams (`#~`, `#Strings`, `#Blob`, `#GUID`, ...) that follow it.
//!
//! # Example
//!
//! ```rust
//! use dotdoc::metadata::root::Root;
//! let root = Root::read(&[
//!            0x42, 0x53, 0x4A, 0x42,
//!            0x01, 0x00,
//!            0x01, 0x00,
//!            0x00, 0x00, 0x00, 0x00,
//!            0x04, 0x00, 0x00, 0x00,
//!            b'v', b'4', 0x00, 0x00,
//!            0x00, 0x00,
//!            0x01, 0x00,
//!            0x24, 0x00, 0x00, 0x00, // StreamHeader
//!            0x04, 0x00, 0x00, 0x00,
//!            0x23, 0x7E, 0x00, 0x00,
//!            0x00, 0x00, 0x00, 0x00,
//!        ])?;
//! assert_eq!(root.version, "v4");
//! assert_eq!(root.stream("#~").map(|s| s.size), Some(4));
//! # Ok::<(), dotdoc::Error>(())
//! ```

use crate::{
    file::io::{read_le, read_le_at, write_le},
    metadata::streams::StreamHeader,
    Error::OutOfBounds,
    Result,
};

/// The magic signature at the start of the metadata root ('BSJB')
pub const CIL_HEADER_MAGIC: u32 = 0x424A_5342;

/// The version string written by [`Root::write_image`]
pub const DEFAULT_VERSION: &str = "v4.0.30319";

/// The parsed metadata root.
pub struct Root {
    /// Magic signature, always [`CIL_HEADER_MAGIC`]
    pub signature: u32,
    /// Major version, ignored on read
    pub major_version: u16,
    /// Minor version, ignored on read
    pub minor_version: u16,
    /// Reserved, always 0
    pub reserved: u32,
    /// Length of the version string field, including padding
    pub length: u32,
    /// The runtime version the module targets
    pub version: String,
    /// Reserved, always 0
    pub flags: u16,
    /// Number of streams
    pub stream_number: u16,
    /// Stream directory
    pub stream_headers: Vec<StreamHeader>,
}

impl Root {
    /// Reads the metadata root from the start of `data`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the root or a stream exceeds `data`, and
    /// [`crate::Error::Malformed`] for a bad signature or stream directory.
    pub fn read(data: &[u8]) -> Result<Root> {
        if data.len() < 20 {
            return Err(OutOfBounds);
        }

        let signature = read_le::<u32>(data)?;
        if signature != CIL_HEADER_MAGIC {
            return Err(malformed_error!(
                "CIL_HEADER_MAGIC does not match - {}",
                signature
            ));
        }

        let version_field_length = read_le_at::<u32>(data, &mut 12)?;
        let Some(version_end) = (version_field_length as usize).checked_add(16) else {
            return Err(malformed_error!(
                "Version string length causing integer overflow - {}",
                version_field_length
            ));
        };
        if version_end + 4 > data.len() {
            return Err(OutOfBounds);
        }

        let version_bytes = &data[16..version_end];
        let version_len = version_bytes
            .iter()
            .position(|byte| *byte == 0)
            .unwrap_or(version_bytes.len());
        let version = String::from_utf8_lossy(&version_bytes[..version_len]).into_owned();

        let flags = read_le_at::<u16>(data, &mut { version_end })?;
        let stream_count = read_le_at::<u16>(data, &mut (version_end + 2))?;
        if stream_count == 0 || stream_count > 6 || (stream_count as usize * 9) > data.len() {
            return Err(malformed_error!("Invalid stream count - {}", stream_count));
        }

        let mut streams: Vec<StreamHeader> = Vec::with_capacity(stream_count as usize);
        let mut stream_offset = version_end + 4;
        for _ in 0..stream_count {
            if stream_offset > data.len() {
                return Err(OutOfBounds);
            }

            let new_stream = StreamHeader::from(&data[stream_offset..])?;
            match new_stream.offset.checked_add(new_stream.size) {
                Some(end) if end as usize <= data.len() => {}
                Some(_) => return Err(OutOfBounds),
                None => {
                    return Err(malformed_error!(
                        "Stream offset and size cause integer overflow - {} + {}",
                        new_stream.offset,
                        new_stream.size
                    ))
                }
            }

            if streams.iter().any(|stream| stream.name == new_stream.name) {
                return Err(malformed_error!("Duplicate stream - {}", new_stream.name));
            }

            stream_offset += new_stream.encoded_len();
            streams.push(new_stream);
        }

        Ok(Root {
            signature,
            major_version: read_le::<u16>(&data[4..])?,
            minor_version: read_le::<u16>(&data[6..])?,
            reserved: read_le::<u32>(&data[8..])?,
            length: version_field_length,
            version,
            flags,
            stream_number: stream_count,
            stream_headers: streams,
        })
    }

    /// Looks up a stream header by name.
    #[must_use]
    pub fn stream(&self, name: &str) -> Option<&StreamHeader> {
        self.stream_headers.iter().find(|stream| stream.name == name)
    }

    /// Serialises a complete metadata image: the root, its stream directory and the streams.
    ///
    /// Each stream is padded to a 4 byte boundary, as is the version string.
    #[must_use]
    pub fn write_image(version: &str, streams: &[(&str, &[u8])]) -> Vec<u8> {
        let version_field_length = (version.len() + 1 + 3) & !3;

        let mut headers: Vec<StreamHeader> = streams
            .iter()
            .map(|(name, data)| StreamHeader {
                offset: 0,
                #[allow(clippy::cast_possible_truncation)]
                size: ((data.len() + 3) & !3) as u32,
                name: (*name).to_string(),
            })
            .collect();

        let directory_len: usize = headers.iter().map(StreamHeader::encoded_len).sum();
        let mut offset = 16 + version_field_length + 4 + directory_len;
        for header in &mut headers {
            #[allow(clippy::cast_possible_truncation)]
            {
                header.offset = offset as u32;
            }
            offset += header.size as usize;
        }

        let mut buffer = Vec::with_capacity(offset);
        write_le(&mut buffer, CIL_HEADER_MAGIC);
        write_le(&mut buffer, 1_u16);
        write_le(&mut buffer, 1_u16);
        write_le(&mut buffer, 0_u32);
        #[allow(clippy::cast_possible_truncation)]
        write_le(&mut buffer, version_field_length as u32);
        buffer.extend_from_slice(version.as_bytes());
        buffer.resize(16 + version_field_length, 0);
        write_le(&mut buffer, 0_u16);
        #[allow(clippy::cast_possible_truncation)]
        write_le(&mut buffer, headers.len() as u16);
        for header in &headers {
            header.write(&mut buffer);
        }
        for (header, (_, data)) in headers.iter().zip(streams) {
            buffer.extend_from_slice(data);
            buffer.resize(header.offset as usize + header.size as usize, 0);
        }

        buffer
    }
}
