//! Module image access.
//!
//! A module reaches the metadata layer in one of two shapes:
//!
//! - a PE image carrying a CLI header, whose metadata directory is located through the PE data
//!   directories (parsed with `goblin`)
//! - a bare ECMA-335 metadata image, which starts directly with the `BSJB` metadata root, as
//!   produced by [`crate::metadata::builder::ModuleBuilder::to_bytes`]
//!
//! The shape is detected from the content, never from the file extension. [`File`] owns the
//! bytes (memory-mapped for files on disk, owned for buffers) and remembers where the metadata
//! root lives inside them.

pub mod io;
pub mod parser;

mod image;

use std::{ops::Range, path::Path};

use goblin::pe::PE;

use crate::{
    file::io::read_le,
    metadata::root::CIL_HEADER_MAGIC,
    Error::{Empty, GoblinErr, NotSupported},
    Result,
};
use image::Image;

/// The container format a [`File`] was recognized as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// A PE image with a CLI header.
    Pe,
    /// A bare metadata image starting with the metadata root.
    Metadata,
}

/// A loaded module image with its metadata range located.
pub struct File {
    image: Image,
    kind: FileKind,
    metadata: Range<usize>,
}

impl File {
    /// Memory-maps and inspects the module at `file`.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be opened, and the decoding errors
    /// of [`File::from_mem`] otherwise.
    pub fn from_file(file: &Path) -> Result<File> {
        Self::load(Image::map(file)?)
    }

    /// Inspects a module image held in memory.
    ///
    /// # Errors
    /// Returns [`crate::Error::Empty`] for empty input, [`crate::Error::NotSupported`] if the
    /// data is neither a PE image nor a metadata image, and [`crate::Error::Malformed`] or
    /// [`crate::Error::GoblinErr`] if the PE structure is damaged.
    pub fn from_mem(data: Vec<u8>) -> Result<File> {
        Self::load(Image::Owned(data))
    }

    fn load(image: Image) -> Result<File> {
        let bytes = image.bytes();
        if bytes.is_empty() {
            return Err(Empty);
        }

        let (kind, metadata) = if bytes.starts_with(b"MZ") {
            (FileKind::Pe, Self::locate_cli_metadata(bytes)?)
        } else if read_le::<u32>(bytes).ok() == Some(CIL_HEADER_MAGIC) {
            (FileKind::Metadata, 0..bytes.len())
        } else {
            return Err(NotSupported);
        };

        if metadata.end > bytes.len() || metadata.is_empty() {
            return Err(malformed_error!(
                "Metadata range {:?} exceeds image of {} bytes",
                metadata,
                bytes.len()
            ));
        }

        Ok(File {
            image,
            kind,
            metadata,
        })
    }

    /// Follows the CLI header of a PE image to its metadata directory.
    fn locate_cli_metadata(bytes: &[u8]) -> Result<Range<usize>> {
        let pe = match PE::parse(bytes) {
            Ok(pe) => pe,
            Err(error) => return Err(GoblinErr(error)),
        };

        let Some(optional_header) = pe.header.optional_header else {
            return Err(malformed_error!("File does not have an OptionalHeader"));
        };
        let Some(clr_dir) = optional_header.data_directories.get_clr_runtime_header() else {
            return Err(malformed_error!(
                "File does not have a CLR runtime header directory"
            ));
        };

        let cli_offset = Self::rva_to_offset(&pe, clr_dir.virtual_address as usize)?;
        let Some(cli_header) = bytes.get(cli_offset..cli_offset + 16) else {
            return Err(out_of_bounds_error!());
        };

        // cb, MajorRuntimeVersion, MinorRuntimeVersion, then the MetaData directory
        let metadata_rva = read_le::<u32>(&cli_header[8..])? as usize;
        let metadata_size = read_le::<u32>(&cli_header[12..])? as usize;
        let metadata_offset = Self::rva_to_offset(&pe, metadata_rva)?;

        Ok(metadata_offset..metadata_offset + metadata_size)
    }

    fn rva_to_offset(pe: &PE, rva: usize) -> Result<usize> {
        for section in &pe.sections {
            let start = section.virtual_address as usize;
            let end = start + section.virtual_size.max(section.size_of_raw_data) as usize;
            if (start..end).contains(&rva) {
                return Ok(rva - start + section.pointer_to_raw_data as usize);
            }
        }

        Err(malformed_error!(
            "RVA could not be converted to offset - {}",
            rva
        ))
    }

    /// The container format of this image.
    #[must_use]
    pub fn kind(&self) -> FileKind {
        self.kind
    }

    /// Returns the total size of the image
    #[must_use]
    pub fn len(&self) -> usize {
        self.image.bytes().len()
    }

    /// Returns true if the image has a length of zero
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the whole image
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.image.bytes()
    }

    /// Returns a bounds-checked slice of the image
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range is not contained in the image.
    pub fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        self.image.slice(offset, len)
    }

    /// Returns the metadata section, starting at the metadata root.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the located range no longer fits the image.
    pub fn metadata(&self) -> Result<&[u8]> {
        self.image.slice(self.metadata.start, self.metadata.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_metadata_image() {
        let mut data = vec![0x42, 0x53, 0x4A, 0x42];
        data.extend_from_slice(&[0_u8; 28]);

        let file = File::from_mem(data).unwrap();
        assert_eq!(file.kind(), FileKind::Metadata);
        assert_eq!(file.metadata().unwrap().len(), 32);
    }

    #[test]
    fn reject_unknown_content() {
        assert!(matches!(File::from_mem(Vec::new()), Err(Empty)));
        assert!(matches!(
            File::from_mem(b"\x7fELF\x02\x01\x01".to_vec()),
            Err(NotSupported)
        ));
    }

    #[test]
    fn reject_damaged_pe() {
        let mut data = b"MZ".to_vec();
        data.extend_from_slice(&[0_u8; 62]);

        assert!(File::from_mem(data).is_err());
    }
}
