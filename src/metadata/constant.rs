//! Compile-time constants of fields, parameters and properties (`Constant` table, ECMA-335 II.22.9).

use std::fmt;

use crate::{
    file::io::read_le,
    metadata::signatures::ELEMENT_TYPE,
    Error::OutOfBounds,
    Result,
};

/// A decoded constant value.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum ConstantValue {
    Boolean(bool),
    /// A UTF-16 code unit, which may be half of a surrogate pair
    Char(u16),
    I1(i8),
    U1(u8),
    I2(i16),
    U2(u16),
    I4(i32),
    U4(u32),
    I8(i64),
    U8(u64),
    R4(f32),
    R8(f64),
    String(String),
    /// The null reference, stored as a 4 byte zero of type `CLASS`
    Null,
}

impl ConstantValue {
    /// Decodes the value blob of a `Constant` row with the given element type.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for truncated blobs and [`crate::Error::Malformed`]
    /// for element types a constant may not have.
    pub fn decode(element_type: u8, data: &[u8]) -> Result<ConstantValue> {
        Ok(match element_type {
            ELEMENT_TYPE::BOOLEAN => ConstantValue::Boolean(read_le::<u8>(data)? != 0),
            ELEMENT_TYPE::CHAR => ConstantValue::Char(read_le::<u16>(data)?),
            ELEMENT_TYPE::I1 => ConstantValue::I1(read_le::<i8>(data)?),
            ELEMENT_TYPE::U1 => ConstantValue::U1(read_le::<u8>(data)?),
            ELEMENT_TYPE::I2 => ConstantValue::I2(read_le::<i16>(data)?),
            ELEMENT_TYPE::U2 => ConstantValue::U2(read_le::<u16>(data)?),
            ELEMENT_TYPE::I4 => ConstantValue::I4(read_le::<i32>(data)?),
            ELEMENT_TYPE::U4 => ConstantValue::U4(read_le::<u32>(data)?),
            ELEMENT_TYPE::I8 => ConstantValue::I8(read_le::<i64>(data)?),
            ELEMENT_TYPE::U8 => ConstantValue::U8(read_le::<u64>(data)?),
            ELEMENT_TYPE::R4 => ConstantValue::R4(read_le::<f32>(data)?),
            ELEMENT_TYPE::R8 => ConstantValue::R8(read_le::<f64>(data)?),
            ELEMENT_TYPE::STRING => {
                if data.len() % 2 != 0 {
                    return Err(OutOfBounds);
                }
                let units: Vec<u16> = data
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                    .collect();
                ConstantValue::String(String::from_utf16_lossy(&units))
            }
            ELEMENT_TYPE::CLASS => ConstantValue::Null,
            _ => {
                return Err(malformed_error!(
                    "Invalid element type for constant - {}",
                    element_type
                ))
            }
        })
    }

    /// Encodes the value into its element type and blob.
    #[must_use]
    pub fn encode(&self) -> (u8, Vec<u8>) {
        match self {
            ConstantValue::Boolean(value) => (ELEMENT_TYPE::BOOLEAN, vec![u8::from(*value)]),
            ConstantValue::Char(value) => (ELEMENT_TYPE::CHAR, value.to_le_bytes().to_vec()),
            ConstantValue::I1(value) => (ELEMENT_TYPE::I1, value.to_le_bytes().to_vec()),
            ConstantValue::U1(value) => (ELEMENT_TYPE::U1, value.to_le_bytes().to_vec()),
            ConstantValue::I2(value) => (ELEMENT_TYPE::I2, value.to_le_bytes().to_vec()),
            ConstantValue::U2(value) => (ELEMENT_TYPE::U2, value.to_le_bytes().to_vec()),
            ConstantValue::I4(value) => (ELEMENT_TYPE::I4, value.to_le_bytes().to_vec()),
            ConstantValue::U4(value) => (ELEMENT_TYPE::U4, value.to_le_bytes().to_vec()),
            ConstantValue::I8(value) => (ELEMENT_TYPE::I8, value.to_le_bytes().to_vec()),
            ConstantValue::U8(value) => (ELEMENT_TYPE::U8, value.to_le_bytes().to_vec()),
            ConstantValue::R4(value) => (ELEMENT_TYPE::R4, value.to_le_bytes().to_vec()),
            ConstantValue::R8(value) => (ELEMENT_TYPE::R8, value.to_le_bytes().to_vec()),
            ConstantValue::String(value) => (
                ELEMENT_TYPE::STRING,
                value.encode_utf16().flat_map(u16::to_le_bytes).collect(),
            ),
            ConstantValue::Null => (ELEMENT_TYPE::CLASS, vec![0; 4]),
        }
    }
}

impl fmt::Display for ConstantValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstantValue::Boolean(value) => write!(f, "{value}"),
            ConstantValue::Char(value) => match char::from_u32(u32::from(*value)) {
                Some(value) => write!(f, "'{}'", value.escape_debug()),
                None => write!(f, "'\\u{value:04x}'"),
            },
            ConstantValue::I1(value) => write!(f, "{value}"),
            ConstantValue::U1(value) => write!(f, "{value}"),
            ConstantValue::I2(value) => write!(f, "{value}"),
            ConstantValue::U2(value) => write!(f, "{value}"),
            ConstantValue::I4(value) => write!(f, "{value}"),
            ConstantValue::U4(value) => write!(f, "{value}"),
            ConstantValue::I8(value) => write!(f, "{value}"),
            ConstantValue::U8(value) => write!(f, "{value}"),
            ConstantValue::R4(value) => write!(f, "{value}"),
            ConstantValue::R8(value) => write!(f, "{value}"),
            ConstantValue::String(value) => write!(f, "\"{value}\""),
            ConstantValue::Null => write!(f, "null"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_values() {
        assert_eq!(
            ConstantValue::decode(ELEMENT_TYPE::I4, &[0xFE, 0xFF, 0xFF, 0xFF]).unwrap(),
            ConstantValue::I4(-2)
        );
        assert_eq!(
            ConstantValue::decode(ELEMENT_TYPE::STRING, &[b'h', 0, b'i', 0]).unwrap(),
            ConstantValue::String("hi".to_string())
        );
        assert_eq!(
            ConstantValue::decode(ELEMENT_TYPE::CLASS, &[0, 0, 0, 0]).unwrap(),
            ConstantValue::Null
        );
        assert!(ConstantValue::decode(ELEMENT_TYPE::I8, &[1, 2]).is_err());
        assert!(ConstantValue::decode(ELEMENT_TYPE::SZARRAY, &[]).is_err());
    }

    #[test]
    fn encode_matches_decode() {
        for value in [
            ConstantValue::Boolean(true),
            ConstantValue::Char(u16::from(b'x')),
            ConstantValue::Char(0xD83D),
            ConstantValue::U2(513),
            ConstantValue::R8(0.5),
            ConstantValue::String(String::new()),
        ] {
            let (element_type, blob) = value.encode();
            assert_eq!(ConstantValue::decode(element_type, &blob).unwrap(), value);
        }
    }

    #[test]
    fn display() {
        assert_eq!(ConstantValue::String("a".into()).to_string(), "\"a\"");
        assert_eq!(ConstantValue::Null.to_string(), "null");
        assert_eq!(ConstantValue::Char(0x41).to_string(), "'A'");
        assert_eq!(ConstantValue::Char(0xDE00).to_string(), "'\\ude00'");
    }

    #[test]
    fn chars_are_code_units() {
        // A lone high surrogate survives decoding unchanged
        assert_eq!(
            ConstantValue::decode(ELEMENT_TYPE::CHAR, &[0x3D, 0xD8]).unwrap(),
            ConstantValue::Char(0xD83D)
        );
        assert_eq!(
            ConstantValue::Char(0xD83D).encode(),
            (ELEMENT_TYPE::CHAR, vec![0x3D, 0xD8])
        );
        assert!(ConstantValue::decode(ELEMENT_TYPE::CHAR, &[0x41]).is_err());
    }
}
