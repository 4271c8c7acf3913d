//! Signature blobs of ECMA-335 II.23.2.
//!
//! Signatures encode the types of fields, the parameter and return types of methods and
//! properties, generic instantiations (`TypeSpec`, `MethodSpec`) and the calling convention, in a
//! compact prefix encoding. [`SignatureParser`] decodes them into [`TypeSignature`] trees, the
//! `encode_*` functions write them back for [`crate::metadata::builder::ModuleBuilder`].
//!
//! Custom modifiers are kept on parameters and fields, where they distinguish `in` parameters and
//! `init` accessors; modifiers nested inside a type are consumed and dropped, since they do not
//! take part in signature identity.
//!
//! # Examples
//!
//! ```rust
//! use dotdoc::metadata::signatures::{parse_method_signature, TypeSignature};
//!
//! // instance void (int32, string)
//! let signature = parse_method_signature(&[0x20, 0x02, 0x01, 0x08, 0x0E])?;
//! assert!(signature.has_this);
//! assert_eq!(signature.return_type.base, TypeSignature::Void);
//! assert_eq!(signature.params[1].base, TypeSignature::String);
//! # Ok::<(), dotdoc::Error>(())
//! ```

mod encoder;
mod parser;
mod types;

pub use encoder::*;
pub use parser::*;
pub use types::*;

use crate::Result;

#[allow(non_snake_case, dead_code, missing_docs)]
/// Possible bytes that represent the element types of a signature
pub mod ELEMENT_TYPE {
    pub const END: u8 = 0x00;
    pub const VOID: u8 = 0x01;
    pub const BOOLEAN: u8 = 0x02;
    pub const CHAR: u8 = 0x03;
    pub const I1: u8 = 0x04;
    pub const U1: u8 = 0x05;
    pub const I2: u8 = 0x06;
    pub const U2: u8 = 0x07;
    pub const I4: u8 = 0x08;
    pub const U4: u8 = 0x09;
    pub const I8: u8 = 0x0a;
    pub const U8: u8 = 0x0b;
    pub const R4: u8 = 0x0c;
    pub const R8: u8 = 0x0d;
    pub const STRING: u8 = 0x0e;
    // Followed by type
    pub const PTR: u8 = 0x0f;
    // Followed by type
    pub const BYREF: u8 = 0x10;
    // Followed by TypeDefOrRefOrSpecEncoded
    pub const VALUETYPE: u8 = 0x11;
    // Followed by TypeDefOrRefOrSpecEncoded
    pub const CLASS: u8 = 0x12;
    // Generic parameter of a type, by number
    pub const VAR: u8 = 0x13;
    // type rank boundsCount bound1 … loCount lo1 …
    pub const ARRAY: u8 = 0x14;
    // Followed by type type-arg-count type-1 ... type-n
    pub const GENERICINST: u8 = 0x15;
    pub const TYPEDBYREF: u8 = 0x16;
    pub const I: u8 = 0x18;
    pub const U: u8 = 0x19;
    // Followed by full method signature
    pub const FNPTR: u8 = 0x1b;
    pub const OBJECT: u8 = 0x1c;
    // Single-dim array with 0 lower bound
    pub const SZARRAY: u8 = 0x1d;
    // Generic parameter of a method, by number
    pub const MVAR: u8 = 0x1e;
    pub const CMOD_REQD: u8 = 0x1f;
    pub const CMOD_OPT: u8 = 0x20;
    pub const INTERNAL: u8 = 0x21;
    pub const SENTINEL: u8 = 0x41;
    pub const PINNED: u8 = 0x45;
}

#[allow(non_snake_case, dead_code, missing_docs)]
/// Leading bytes of method, field and property signatures
pub mod SIGNATURE_HEADER {
    pub const DEFAULT: u8 = 0x00;
    pub const VARARG: u8 = 0x05;
    pub const FIELD: u8 = 0x06;
    pub const PROPERTY: u8 = 0x08;
    pub const GENERIC_INST: u8 = 0x0a;
    pub const GENERIC: u8 = 0x10;
    pub const HAS_THIS: u8 = 0x20;
    pub const EXPLICIT_THIS: u8 = 0x40;
}

/// Parse a `MethodSignature` from a byte slice
///
/// # Errors
/// Returns an error if the signature data is malformed or parsing fails
pub fn parse_method_signature(data: &[u8]) -> Result<SignatureMethod> {
    let mut parser = SignatureParser::new(data);
    parser.parse_method_signature()
}

/// Parse a `FieldSignature` from a byte slice
///
/// # Errors
/// Returns an error if the signature data is malformed or parsing fails
pub fn parse_field_signature(data: &[u8]) -> Result<SignatureField> {
    let mut parser = SignatureParser::new(data);
    parser.parse_field_signature()
}

/// Parse a `PropertySignature` from a byte slice
///
/// # Errors
/// Returns an error if the signature data is malformed or parsing fails
pub fn parse_property_signature(data: &[u8]) -> Result<SignatureProperty> {
    let mut parser = SignatureParser::new(data);
    parser.parse_property_signature()
}

/// Parse a `TypeSpec` signature from a byte slice
///
/// # Errors
/// Returns an error if the signature data is malformed or parsing fails
pub fn parse_type_spec_signature(data: &[u8]) -> Result<SignatureTypeSpec> {
    let mut parser = SignatureParser::new(data);
    parser.parse_type_spec_signature()
}

/// Parse a `MethodSpec` signature from a byte slice
///
/// # Errors
/// Returns an error if the signature data is malformed or parsing fails
pub fn parse_method_spec_signature(data: &[u8]) -> Result<SignatureMethodSpec> {
    let mut parser = SignatureParser::new(data);
    parser.parse_method_spec_signature()
}

/// Parse the signature of a `MemberRef`, which is either a field or a method signature
///
/// # Errors
/// Returns an error if the signature data is malformed or parsing fails
pub fn parse_member_ref_signature(data: &[u8]) -> Result<SignatureMemberRef> {
    match data.first() {
        Some(&SIGNATURE_HEADER::FIELD) => {
            Ok(SignatureMemberRef::Field(parse_field_signature(data)?))
        }
        Some(_) => Ok(SignatureMemberRef::Method(parse_method_signature(data)?)),
        None => Err(crate::Error::Empty),
    }
}

/// Writes `value` as an ECMA-335 compressed unsigned integer (II.23.2).
///
/// Values above `0x1FFF_FFFF` are not representable and are truncated to 29 bits.
pub fn write_compressed_uint(value: u32, buffer: &mut Vec<u8>) {
    if value < 0x80 {
        #[allow(clippy::cast_possible_truncation)]
        buffer.push(value as u8);
    } else if value < 0x4000 {
        buffer.extend_from_slice(&(0x8000_u16 | value as u16).to_be_bytes());
    } else {
        buffer.extend_from_slice(&(0xC000_0000 | (value & 0x1FFF_FFFF)).to_be_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{file::parser::Parser, metadata::token::Token};

    #[test]
    fn test_compressed_uint_vectors() {
        for (value, expected) in [
            (0x03_u32, vec![0x03]),
            (0x7F, vec![0x7F]),
            (0x80, vec![0x80, 0x80]),
            (0x2E57, vec![0xAE, 0x57]),
            (0x3FFF, vec![0xBF, 0xFF]),
            (0x4000, vec![0xC0, 0x00, 0x40, 0x00]),
            (0x1FFF_FFFF, vec![0xDF, 0xFF, 0xFF, 0xFF]),
        ] {
            let mut buffer = Vec::new();
            write_compressed_uint(value, &mut buffer);
            assert_eq!(buffer, expected, "{value:#x}");

            let mut parser = Parser::new(&buffer);
            assert_eq!(parser.read_compressed_uint().unwrap(), value);
        }
    }

    #[test]
    fn test_parse_method_signature() {
        // static !!0 Method<T>(int32[], class [TypeRef 3])
        let signature = parse_method_signature(&[
            0x10, 0x01, 0x02, 0x1E, 0x00, 0x1D, 0x08, 0x12, 0x0D,
        ])
        .unwrap();

        assert!(!signature.has_this);
        assert_eq!(signature.param_count_generic, 1);
        assert_eq!(signature.return_type.base, TypeSignature::GenericParamMethod(0));
        assert_eq!(
            signature.params[0].base,
            TypeSignature::SzArray(Box::new(TypeSignature::I4))
        );
        assert_eq!(
            signature.params[1].base,
            TypeSignature::Class(Token::new(0x0100_0003))
        );
    }

    #[test]
    fn test_parse_field_signature() {
        let field = parse_field_signature(&[0x06, 0x0F, 0x08]).unwrap();
        assert_eq!(field.base, TypeSignature::Ptr(Box::new(TypeSignature::I4)));

        assert!(parse_field_signature(&[0x07, 0x08]).is_err());
    }

    #[test]
    fn test_parse_property_signature() {
        // instance string Item(int32)
        let property = parse_property_signature(&[0x28, 0x01, 0x0E, 0x08]).unwrap();
        assert!(property.has_this);
        assert_eq!(property.base, TypeSignature::String);
        assert_eq!(property.params.len(), 1);
        assert_eq!(property.params[0].base, TypeSignature::I4);
    }

    #[test]
    fn test_parse_generic_instances() {
        // GenericInst class [TypeDef 1] <int32, !0>
        let spec = parse_type_spec_signature(&[0x15, 0x12, 0x04, 0x02, 0x08, 0x13, 0x00]).unwrap();
        assert_eq!(
            spec.base,
            TypeSignature::GenericInst(
                Box::new(TypeSignature::Class(Token::new(0x0200_0001))),
                vec![TypeSignature::I4, TypeSignature::GenericParamType(0)]
            )
        );

        let method_spec = parse_method_spec_signature(&[0x0A, 0x02, 0x0E, 0x1C]).unwrap();
        assert_eq!(
            method_spec.generic_args,
            vec![TypeSignature::String, TypeSignature::Object]
        );
    }

    #[test]
    fn test_parse_member_ref_signature() {
        assert!(matches!(
            parse_member_ref_signature(&[0x06, 0x08]).unwrap(),
            SignatureMemberRef::Field(_)
        ));
        assert!(matches!(
            parse_member_ref_signature(&[0x20, 0x00, 0x01]).unwrap(),
            SignatureMemberRef::Method(_)
        ));
        assert!(parse_member_ref_signature(&[]).is_err());
    }
}
