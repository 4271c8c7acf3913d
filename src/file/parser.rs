//! Low-level byte stream parser for metadata decoding.
//!
//! [`Parser`] is a cursor over a byte slice with bounds-checked, little-endian reads and the
//! compressed encodings ECMA-335 uses inside signature blobs (II.23.2).
//!
//! # Examples
//!
//! ```rust
//! use dotdoc::Parser;
//!
//! let blob = [0x03, 0x80, 0x95, 0x01];
//! let mut parser = Parser::new(&blob);
//!
//! assert_eq!(parser.read_compressed_uint()?, 3);
//! assert_eq!(parser.read_compressed_uint()?, 0x95);
//! assert_eq!(parser.read_le::<u8>()?, 1);
//! # Ok::<(), dotdoc::Error>(())
//! ```

use crate::{
    file::io::{read_le_at, CilIO},
    metadata::token::Token,
    Result,
};

/// A generic binary data parser for reading metadata structures.
///
/// The parser maintains an internal position cursor and checks every read against the end of
/// the underlying slice, so truncated or hostile input turns into
/// [`crate::Error::OutOfBounds`] instead of a panic.
pub struct Parser<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new `Parser` positioned at the start of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Returns the length of the data
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the data has a length of zero
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Check if there is more data to parse
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Number of bytes left after the cursor.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Move to an absolute position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `pos` is past the end of the data.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(out_of_bounds_error!());
        }

        self.position = pos;
        Ok(())
    }

    /// Move the position forward by one byte.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] at the end of the data.
    pub fn advance(&mut self) -> Result<()> {
        self.advance_by(1)
    }

    /// Move the position forward by `step` bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the move would pass the end of the data.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        let Some(target) = self.position.checked_add(step) else {
            return Err(out_of_bounds_error!());
        };

        self.seek(target)
    }

    /// Get the current position of the parser
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Get access to the whole underlying buffer
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Align the position to the next multiple of `alignment`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the aligned position is past the end.
    pub fn align(&mut self, alignment: usize) -> Result<()> {
        let padding = (alignment - (self.position % alignment)) % alignment;
        self.advance_by(padding)
    }

    /// Peek at the byte under the cursor without advancing.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] at the end of the data.
    pub fn peek_byte(&self) -> Result<u8> {
        self.data
            .get(self.position)
            .copied()
            .ok_or(out_of_bounds_error!())
    }

    /// Read a little-endian value and advance.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
    pub fn read_le<T: CilIO>(&mut self) -> Result<T> {
        read_le_at(self.data, &mut self.position)
    }

    /// Borrow the next `length` bytes and advance past them.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
    pub fn read_bytes(&mut self, length: usize) -> Result<&'a [u8]> {
        let Some(end) = self.position.checked_add(length) else {
            return Err(out_of_bounds_error!());
        };
        let Some(bytes) = self.data.get(self.position..end) else {
            return Err(out_of_bounds_error!());
        };

        self.position = end;
        Ok(bytes)
    }

    /// Read a compressed unsigned integer (ECMA-335 II.23.2).
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for an invalid leading byte and
    /// [`crate::Error::OutOfBounds`] for truncated data.
    pub fn read_compressed_uint(&mut self) -> Result<u32> {
        let first_byte = self.read_le::<u8>()?;

        // 1-byte encoding: 0xxxxxxx
        if (first_byte & 0x80) == 0 {
            return Ok(u32::from(first_byte));
        }

        // 2-byte encoding: 10xxxxxx xxxxxxxx
        if (first_byte & 0xC0) == 0x80 {
            let second_byte = self.read_le::<u8>()?;
            return Ok(((u32::from(first_byte) & 0x3F) << 8) | u32::from(second_byte));
        }

        // 4-byte encoding: 110xxxxx xxxxxxxx xxxxxxxx xxxxxxxx
        if (first_byte & 0xE0) == 0xC0 {
            let b1 = u32::from(self.read_le::<u8>()?);
            let b2 = u32::from(self.read_le::<u8>()?);
            let b3 = u32::from(self.read_le::<u8>()?);
            return Ok(((u32::from(first_byte) & 0x1F) << 24) | (b1 << 16) | (b2 << 8) | b3);
        }

        Err(malformed_error!("Invalid compressed uint - {}", first_byte))
    }

    /// Read a compressed signed integer (ECMA-335 II.23.2).
    ///
    /// The sign bit is rotated into the least significant position, and the width of the
    /// encoding decides the bias applied to negative values.
    ///
    /// # Errors
    /// Returns an error if the underlying unsigned read fails.
    #[allow(clippy::cast_possible_wrap)]
    pub fn read_compressed_int(&mut self) -> Result<i32> {
        let start = self.position;
        let unsigned = self.read_compressed_uint()?;
        let bias = match self.position - start {
            1 => 0x40,
            2 => 0x2000,
            _ => 0x1000_0000,
        };

        let magnitude = (unsigned >> 1) as i32;
        if unsigned & 1 == 0 {
            Ok(magnitude)
        } else {
            Ok(magnitude - bias)
        }
    }

    /// Read a `TypeDefOrRefOrSpecEncoded` token (ECMA-335 II.23.2.8).
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for an unknown table tag.
    pub fn read_compressed_token(&mut self) -> Result<Token> {
        let compressed_token = self.read_compressed_uint()?;

        let table: u32 = match compressed_token & 0x3 {
            0x0 => 0x0200_0000, // TypeDef
            0x1 => 0x0100_0000, // TypeRef
            0x2 => 0x1B00_0000, // TypeSpec
            _ => {
                return Err(malformed_error!(
                    "Invalid compressed token - {}",
                    compressed_token
                ))
            }
        };

        Ok(Token::new(table | (compressed_token >> 2)))
    }

    /// Read a null-terminated UTF-8 string.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if no terminator is found or the bytes are not UTF-8.
    pub fn read_string_utf8(&mut self) -> Result<String> {
        let rest = self.data.get(self.position..).unwrap_or_default();
        let Some(end) = rest.iter().position(|byte| *byte == 0) else {
            return Err(malformed_error!(
                "Unterminated string at offset {}",
                self.position
            ));
        };

        let value = std::str::from_utf8(&rest[..end])
            .map_err(|_| malformed_error!("Invalid UTF-8 string at offset {}", self.position))?
            .to_string();

        self.position += end + 1;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compressed_uint() {
        #[rustfmt::skip]
        let data = [
            0x03,
            0x7F,
            0x80, 0x80,
            0xAE, 0x57,
            0xBF, 0xFF,
            0xC0, 0x00, 0x40, 0x00,
            0xDF, 0xFF, 0xFF, 0xFF,
        ];
        let mut parser = Parser::new(&data);

        assert_eq!(parser.read_compressed_uint().unwrap(), 0x03);
        assert_eq!(parser.read_compressed_uint().unwrap(), 0x7F);
        assert_eq!(parser.read_compressed_uint().unwrap(), 0x80);
        assert_eq!(parser.read_compressed_uint().unwrap(), 0x2E57);
        assert_eq!(parser.read_compressed_uint().unwrap(), 0x3FFF);
        assert_eq!(parser.read_compressed_uint().unwrap(), 0x4000);
        assert_eq!(parser.read_compressed_uint().unwrap(), 0x1FFF_FFFF);
        assert!(!parser.has_more_data());
    }

    #[test]
    fn compressed_int() {
        // Samples from ECMA-335 II.23.2
        #[rustfmt::skip]
        let data = [
            0x06,
            0x7B,
            0x80, 0x80,
            0x01,
            0xC0, 0x00, 0x40, 0x00,
            0x80, 0x01,
            0xDF, 0xFF, 0xFF, 0xFE,
            0xC0, 0x00, 0x00, 0x01,
        ];
        let mut parser = Parser::new(&data);

        assert_eq!(parser.read_compressed_int().unwrap(), 3);
        assert_eq!(parser.read_compressed_int().unwrap(), -3);
        assert_eq!(parser.read_compressed_int().unwrap(), 64);
        assert_eq!(parser.read_compressed_int().unwrap(), -64);
        assert_eq!(parser.read_compressed_int().unwrap(), 8192);
        assert_eq!(parser.read_compressed_int().unwrap(), -8192);
        assert_eq!(parser.read_compressed_int().unwrap(), 268_435_455);
        assert_eq!(parser.read_compressed_int().unwrap(), -268_435_456);
    }

    #[test]
    fn compressed_token() {
        let data = [0x49, 0x0A, 0x10];
        let mut parser = Parser::new(&data);

        assert_eq!(parser.read_compressed_token().unwrap(), Token::new(0x0100_0012));
        assert_eq!(parser.read_compressed_token().unwrap(), Token::new(0x1B00_0002));
        assert_eq!(parser.read_compressed_token().unwrap(), Token::new(0x0200_0004));
    }

    #[test]
    fn strings_and_bytes() {
        let data = b"abc\0\x01\x02\x03";
        let mut parser = Parser::new(data);

        assert_eq!(parser.read_string_utf8().unwrap(), "abc");
        assert_eq!(parser.read_bytes(2).unwrap(), &[0x01, 0x02]);
        assert!(parser.read_bytes(2).is_err());
        assert_eq!(parser.remaining(), 1);
    }

    #[test]
    fn navigation() {
        let data = [0_u8; 10];
        let mut parser = Parser::new(&data);

        parser.advance_by(3).unwrap();
        parser.align(4).unwrap();
        assert_eq!(parser.pos(), 4);
        parser.align(4).unwrap();
        assert_eq!(parser.pos(), 4);
        assert!(parser.seek(11).is_err());
        parser.seek(10).unwrap();
        assert!(parser.peek_byte().is_err());
    }
}
