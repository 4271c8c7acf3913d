//! Endian-aware, bounds-checked primitive reads and writes.
//!
//! Everything in a metadata image is little-endian, so this module only carries the
//! little-endian half of the story. Reads go through [`read_le_at`] and friends against a byte
//! slice and an offset cursor; writes append to a growable buffer, which is all the metadata
//! writer needs.
//!
//! # Examples
//!
//! ```rust,ignore
//! use dotdoc::file::io::{read_le_at, read_le_at_dyn};
//!
//! let data = [0x01, 0x00, 0x02, 0x00, 0x00, 0x00];
//! let mut offset = 0;
//! let small: u16 = read_le_at(&data, &mut offset)?;
//! let large = read_le_at_dyn(&data, &mut offset, true)?;
//! assert_eq!((small, large, offset), (1, 2, 6));
//! # Ok::<(), dotdoc::Error>(())
//! ```

use crate::{Error::OutOfBounds, Result};

/// Trait for implementing type-specific safe binary data reading operations.
///
/// Each implementation names the fixed-size byte array backing the type, and converts between
/// that array and the value in little-endian order.
pub trait CilIO: Sized {
    /// Associated type representing the byte array type for this numeric type.
    type Bytes: Sized + AsRef<[u8]> + for<'a> TryFrom<&'a [u8]>;

    /// Read T from a byte buffer in little-endian
    fn from_le_bytes(bytes: Self::Bytes) -> Self;

    /// Write T to a byte buffer in little-endian
    fn to_le_bytes(self) -> Self::Bytes;
}

macro_rules! impl_cil_io {
    ($($ty:ty => $len:expr),* $(,)?) => {
        $(
            impl CilIO for $ty {
                type Bytes = [u8; $len];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }

                fn to_le_bytes(self) -> Self::Bytes {
                    <$ty>::to_le_bytes(self)
                }
            }
        )*
    };
}

impl_cil_io!(
    u8 => 1, i8 => 1,
    u16 => 2, i16 => 2,
    u32 => 4, i32 => 4,
    u64 => 8, i64 => 8,
    f32 => 4, f64 => 8,
);

/// Safely reads a value of type `T` in little-endian byte order from the start of a buffer.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_le<T: CilIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_le_at(data, &mut offset)
}

/// Safely reads a value of type `T` in little-endian byte order at `offset`, advancing the
/// offset by the number of bytes read.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_le_at<T: CilIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(OutOfBounds);
    };
    if end > data.len() {
        return Err(OutOfBounds);
    }

    let Ok(read) = data[*offset..end].try_into() else {
        return Err(OutOfBounds);
    };

    *offset = end;

    Ok(T::from_le_bytes(read))
}

/// Reads either a 2 or a 4 byte little-endian index, as heap and table indexes are sized.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_le_at_dyn(data: &[u8], offset: &mut usize, is_large: bool) -> Result<u32> {
    let res = if is_large {
        read_le_at::<u32>(data, offset)?
    } else {
        u32::from(read_le_at::<u16>(data, offset)?)
    };

    Ok(res)
}

/// Appends a value of type `T` in little-endian byte order.
pub fn write_le<T: CilIO>(buffer: &mut Vec<u8>, value: T) {
    buffer.extend_from_slice(value.to_le_bytes().as_ref());
}

/// Appends either a 2 or a 4 byte little-endian index.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if `value` does not fit into a small index.
pub fn write_le_dyn(buffer: &mut Vec<u8>, value: u32, is_large: bool) -> Result<()> {
    if is_large {
        write_le(buffer, value);
    } else {
        let Ok(small) = u16::try_from(value) else {
            return Err(OutOfBounds);
        };
        write_le(buffer, small);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_values() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];

        assert_eq!(read_le::<u8>(&data).unwrap(), 0x01);
        assert_eq!(read_le::<u16>(&data).unwrap(), 0x0201);
        assert_eq!(read_le::<u32>(&data).unwrap(), 0x0403_0201);
        assert_eq!(read_le::<u64>(&data).unwrap(), 0x0807_0605_0403_0201);
    }

    #[test]
    fn read_advances_offset() {
        let data = [0xFF, 0xFF, 0x02, 0x00, 0x00, 0x00];
        let mut offset = 0;

        assert_eq!(read_le_at::<i16>(&data, &mut offset).unwrap(), -1);
        assert_eq!(offset, 2);
        assert_eq!(read_le_at_dyn(&data, &mut offset, true).unwrap(), 2);
        assert_eq!(offset, 6);
    }

    #[test]
    fn read_out_of_bounds() {
        let data = [0x01, 0x02, 0x03];
        let mut offset = 2;

        assert!(matches!(read_le_at::<u16>(&data, &mut offset), Err(OutOfBounds)));
        assert_eq!(offset, 2);

        let mut offset = usize::MAX;
        assert!(read_le_at::<u8>(&data, &mut offset).is_err());
    }

    #[test]
    fn write_values() {
        let mut buffer = Vec::new();
        write_le(&mut buffer, 0x0201_u16);
        write_le_dyn(&mut buffer, 3, false).unwrap();
        write_le_dyn(&mut buffer, 4, true).unwrap();

        assert_eq!(buffer, [0x01, 0x02, 0x03, 0x00, 0x04, 0x00, 0x00, 0x00]);
        assert!(write_le_dyn(&mut buffer, 0x1_0000, false).is_err());
    }
}
