//! Byte storage of a module image.

use std::{fs, path::Path};

use memmap2::Mmap;

use crate::{Error, Result};

/// The bytes of a module: a read-only map of a file on disk, or an owned buffer for modules built
/// in-process.
#[derive(Debug)]
pub(crate) enum Image {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl Image {
    /// Maps the file at `path`.
    pub(crate) fn map(path: &Path) -> Result<Image> {
        let file = fs::File::open(path)?;

        // SAFETY: the map is read-only and owned by the image; the file is never written through it
        let map = unsafe { Mmap::map(&file) }.map_err(|error| Error::Error(error.to_string()))?;
        Ok(Image::Mapped(map))
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        match self {
            Image::Mapped(map) => map,
            Image::Owned(data) => data,
        }
    }

    /// `len` bytes at `offset`, or [`Error::OutOfBounds`] if they are not all inside the image
    pub(crate) fn slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        offset
            .checked_add(len)
            .and_then(|end| self.bytes().get(offset..end))
            .ok_or(out_of_bounds_error!())
    }
}
