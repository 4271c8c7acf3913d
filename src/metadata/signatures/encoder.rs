//! Signature blob encoders, the inverse of [`super::SignatureParser`].
//!
//! Array sizes and lower bounds are written as empty lists, which is what compilers emit for the
//! declared `T[,]` shapes the model represents.

use crate::{
    metadata::{
        signatures::{
            write_compressed_uint, CustomModifier, SignatureField, SignatureMethod,
            SignatureMethodSpec, SignatureParameter, SignatureProperty, TypeSignature,
            ELEMENT_TYPE, SIGNATURE_HEADER,
        },
        tables::TableId,
        token::Token,
    },
    Result,
};

/// Encodes a token as a TypeDefOrRefOrSpecEncoded value (ECMA-335 II.23.2.8).
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if the token is not a TypeDef, TypeRef or TypeSpec.
pub fn encode_type_def_or_ref(token: Token) -> Result<u32> {
    let tag = if token.is_table(TableId::TypeDef) {
        0
    } else if token.is_table(TableId::TypeRef) {
        1
    } else if token.is_table(TableId::TypeSpec) {
        2
    } else {
        return Err(malformed_error!(
            "Invalid token table 0x{:02X} for TypeDefOrRef coded index - {}",
            token.table(),
            token
        ));
    };

    Ok((token.row() << 2) | tag)
}

fn encode_custom_modifier(modifier: &CustomModifier, buffer: &mut Vec<u8>) -> Result<()> {
    buffer.push(if modifier.is_required {
        ELEMENT_TYPE::CMOD_REQD
    } else {
        ELEMENT_TYPE::CMOD_OPT
    });
    write_compressed_uint(encode_type_def_or_ref(modifier.modifier_type)?, buffer);
    Ok(())
}

/// Appends the encoding of `signature` to `buffer`.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if a referenced token can not be encoded.
pub fn encode_type(signature: &TypeSignature, buffer: &mut Vec<u8>) -> Result<()> {
    match signature {
        TypeSignature::Void => buffer.push(ELEMENT_TYPE::VOID),
        TypeSignature::Boolean => buffer.push(ELEMENT_TYPE::BOOLEAN),
        TypeSignature::Char => buffer.push(ELEMENT_TYPE::CHAR),
        TypeSignature::I1 => buffer.push(ELEMENT_TYPE::I1),
        TypeSignature::U1 => buffer.push(ELEMENT_TYPE::U1),
        TypeSignature::I2 => buffer.push(ELEMENT_TYPE::I2),
        TypeSignature::U2 => buffer.push(ELEMENT_TYPE::U2),
        TypeSignature::I4 => buffer.push(ELEMENT_TYPE::I4),
        TypeSignature::U4 => buffer.push(ELEMENT_TYPE::U4),
        TypeSignature::I8 => buffer.push(ELEMENT_TYPE::I8),
        TypeSignature::U8 => buffer.push(ELEMENT_TYPE::U8),
        TypeSignature::R4 => buffer.push(ELEMENT_TYPE::R4),
        TypeSignature::R8 => buffer.push(ELEMENT_TYPE::R8),
        TypeSignature::String => buffer.push(ELEMENT_TYPE::STRING),
        TypeSignature::Object => buffer.push(ELEMENT_TYPE::OBJECT),
        TypeSignature::I => buffer.push(ELEMENT_TYPE::I),
        TypeSignature::U => buffer.push(ELEMENT_TYPE::U),
        TypeSignature::TypedByRef => buffer.push(ELEMENT_TYPE::TYPEDBYREF),
        TypeSignature::Class(token) => {
            buffer.push(ELEMENT_TYPE::CLASS);
            write_compressed_uint(encode_type_def_or_ref(*token)?, buffer);
        }
        TypeSignature::ValueType(token) => {
            buffer.push(ELEMENT_TYPE::VALUETYPE);
            write_compressed_uint(encode_type_def_or_ref(*token)?, buffer);
        }
        TypeSignature::GenericInst(base, args) => {
            buffer.push(ELEMENT_TYPE::GENERICINST);
            encode_type(base, buffer)?;
            write_compressed_uint(u32::try_from(args.len()).unwrap_or(u32::MAX), buffer);
            for arg in args {
                encode_type(arg, buffer)?;
            }
        }
        TypeSignature::GenericParamType(number) => {
            buffer.push(ELEMENT_TYPE::VAR);
            write_compressed_uint(*number, buffer);
        }
        TypeSignature::GenericParamMethod(number) => {
            buffer.push(ELEMENT_TYPE::MVAR);
            write_compressed_uint(*number, buffer);
        }
        TypeSignature::SzArray(element) => {
            buffer.push(ELEMENT_TYPE::SZARRAY);
            encode_type(element, buffer)?;
        }
        TypeSignature::Array(element, rank) => {
            buffer.push(ELEMENT_TYPE::ARRAY);
            encode_type(element, buffer)?;
            write_compressed_uint(*rank, buffer);
            // no sizes, no lower bounds
            buffer.push(0);
            buffer.push(0);
        }
        TypeSignature::Ptr(element) => {
            buffer.push(ELEMENT_TYPE::PTR);
            encode_type(element, buffer)?;
        }
        TypeSignature::ByRef(element) => {
            buffer.push(ELEMENT_TYPE::BYREF);
            encode_type(element, buffer)?;
        }
        TypeSignature::FnPtr(method) => {
            buffer.push(ELEMENT_TYPE::FNPTR);
            encode_method_into(method, buffer)?;
        }
    }

    Ok(())
}

fn encode_parameter(parameter: &SignatureParameter, buffer: &mut Vec<u8>) -> Result<()> {
    for modifier in &parameter.modifiers {
        encode_custom_modifier(modifier, buffer)?;
    }

    if parameter.by_ref {
        buffer.push(ELEMENT_TYPE::BYREF);
    }

    encode_type(&parameter.base, buffer)
}

fn encode_method_into(signature: &SignatureMethod, buffer: &mut Vec<u8>) -> Result<()> {
    let mut convention = if signature.vararg {
        SIGNATURE_HEADER::VARARG
    } else {
        SIGNATURE_HEADER::DEFAULT
    };
    if signature.has_this {
        convention |= SIGNATURE_HEADER::HAS_THIS;
    }
    if signature.explicit_this {
        convention |= SIGNATURE_HEADER::EXPLICIT_THIS;
    }
    if signature.param_count_generic > 0 {
        convention |= SIGNATURE_HEADER::GENERIC;
    }
    buffer.push(convention);

    if signature.param_count_generic > 0 {
        write_compressed_uint(signature.param_count_generic, buffer);
    }
    write_compressed_uint(
        u32::try_from(signature.params.len()).unwrap_or(u32::MAX),
        buffer,
    );

    encode_parameter(&signature.return_type, buffer)?;
    for param in &signature.params {
        encode_parameter(param, buffer)?;
    }

    Ok(())
}

/// Encodes a method signature into its blob form.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if a referenced token can not be encoded.
pub fn encode_method_signature(signature: &SignatureMethod) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    encode_method_into(signature, &mut buffer)?;
    Ok(buffer)
}

/// Encodes a field signature into its blob form.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if a referenced token can not be encoded.
pub fn encode_field_signature(signature: &SignatureField) -> Result<Vec<u8>> {
    let mut buffer = vec![SIGNATURE_HEADER::FIELD];
    for modifier in &signature.modifiers {
        encode_custom_modifier(modifier, &mut buffer)?;
    }
    encode_type(&signature.base, &mut buffer)?;
    Ok(buffer)
}

/// Encodes a property signature into its blob form.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if a referenced token can not be encoded.
pub fn encode_property_signature(signature: &SignatureProperty) -> Result<Vec<u8>> {
    let mut head = SIGNATURE_HEADER::PROPERTY;
    if signature.has_this {
        head |= SIGNATURE_HEADER::HAS_THIS;
    }

    let mut buffer = vec![head];
    write_compressed_uint(
        u32::try_from(signature.params.len()).unwrap_or(u32::MAX),
        &mut buffer,
    );
    for modifier in &signature.modifiers {
        encode_custom_modifier(modifier, &mut buffer)?;
    }
    encode_type(&signature.base, &mut buffer)?;
    for param in &signature.params {
        encode_parameter(param, &mut buffer)?;
    }

    Ok(buffer)
}

/// Encodes a `TypeSpec` signature into its blob form.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if a referenced token can not be encoded.
pub fn encode_typespec_signature(signature: &TypeSignature) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    encode_type(signature, &mut buffer)?;
    Ok(buffer)
}

/// Encodes a `MethodSpec` instantiation into its blob form.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if a referenced token can not be encoded.
pub fn encode_method_spec_signature(signature: &SignatureMethodSpec) -> Result<Vec<u8>> {
    let mut buffer = vec![SIGNATURE_HEADER::GENERIC_INST];
    write_compressed_uint(
        u32::try_from(signature.generic_args.len()).unwrap_or(u32::MAX),
        &mut buffer,
    );
    for arg in &signature.generic_args {
        encode_type(arg, &mut buffer)?;
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::signatures::{
        parse_field_signature, parse_method_signature, parse_property_signature,
        parse_type_spec_signature,
    };

    #[test]
    fn test_encode_method_signature() {
        let signature = SignatureMethod {
            has_this: true,
            param_count_generic: 1,
            return_type: SignatureParameter::new(TypeSignature::GenericParamMethod(0)),
            params: vec![
                SignatureParameter::by_ref(TypeSignature::I4),
                SignatureParameter::new(TypeSignature::Array(Box::new(TypeSignature::R8), 2)),
            ],
            ..SignatureMethod::default()
        };

        let encoded = encode_method_signature(&signature).unwrap();
        assert_eq!(
            encoded,
            vec![0x30, 0x01, 0x02, 0x1E, 0x00, 0x10, 0x08, 0x14, 0x0D, 0x02, 0x00, 0x00]
        );
        assert_eq!(parse_method_signature(&encoded).unwrap(), signature);
    }

    #[test]
    fn test_encode_field_and_property() {
        let field = SignatureField {
            modifiers: vec![CustomModifier {
                is_required: true,
                modifier_type: Token::new(0x0100_0004),
            }],
            base: TypeSignature::Class(Token::new(0x0200_0002)),
        };
        let encoded = encode_field_signature(&field).unwrap();
        assert_eq!(encoded, vec![0x06, 0x1F, 0x11, 0x12, 0x08]);
        assert_eq!(parse_field_signature(&encoded).unwrap(), field);

        let property = SignatureProperty {
            has_this: true,
            modifiers: Vec::new(),
            base: TypeSignature::String,
            params: vec![SignatureParameter::new(TypeSignature::I4)],
        };
        let encoded = encode_property_signature(&property).unwrap();
        assert_eq!(parse_property_signature(&encoded).unwrap(), property);
    }

    #[test]
    fn test_encode_generic_instance() {
        let spec = TypeSignature::GenericInst(
            Box::new(TypeSignature::ValueType(Token::new(0x0100_0001))),
            vec![TypeSignature::GenericParamType(1)],
        );
        let encoded = encode_typespec_signature(&spec).unwrap();
        assert_eq!(encoded, vec![0x15, 0x11, 0x05, 0x01, 0x13, 0x01]);
        assert_eq!(parse_type_spec_signature(&encoded).unwrap().base, spec);
    }

    #[test]
    fn test_encode_type_def_or_ref_error() {
        assert!(encode_type_def_or_ref(Token::new(0x0600_0001)).is_err());
        assert_eq!(encode_type_def_or_ref(Token::new(0x1B00_0003)).unwrap(), 14);
    }
}
