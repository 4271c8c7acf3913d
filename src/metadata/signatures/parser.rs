use crate::{
    file::parser::Parser,
    metadata::{
        signatures::{
            CustomModifier, SignatureField, SignatureMethod, SignatureMethodSpec,
            SignatureParameter, SignatureProperty, SignatureTypeSpec, TypeSignature,
            ELEMENT_TYPE, SIGNATURE_HEADER,
        },
        token::Token,
    },
    Error::RecursionLimit,
    Result,
};

const MAX_RECURSION_DEPTH: usize = 50;

/// Decoder for all signature kinds over a single blob.
pub struct SignatureParser<'a> {
    parser: Parser<'a>,
    depth: usize,
}

impl<'a> SignatureParser<'a> {
    /// Create a new `SignatureParser` over the bytes of one blob
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        SignatureParser {
            parser: Parser::new(data),
            depth: 0,
        }
    }

    fn parse_type(&mut self) -> Result<TypeSignature> {
        self.depth += 1;
        if self.depth >= MAX_RECURSION_DEPTH {
            return Err(RecursionLimit(MAX_RECURSION_DEPTH));
        }

        let current_byte = self.parser.read_le::<u8>()?;
        let result = match current_byte {
            ELEMENT_TYPE::VOID => TypeSignature::Void,
            ELEMENT_TYPE::BOOLEAN => TypeSignature::Boolean,
            ELEMENT_TYPE::CHAR => TypeSignature::Char,
            ELEMENT_TYPE::I1 => TypeSignature::I1,
            ELEMENT_TYPE::U1 => TypeSignature::U1,
            ELEMENT_TYPE::I2 => TypeSignature::I2,
            ELEMENT_TYPE::U2 => TypeSignature::U2,
            ELEMENT_TYPE::I4 => TypeSignature::I4,
            ELEMENT_TYPE::U4 => TypeSignature::U4,
            ELEMENT_TYPE::I8 => TypeSignature::I8,
            ELEMENT_TYPE::U8 => TypeSignature::U8,
            ELEMENT_TYPE::R4 => TypeSignature::R4,
            ELEMENT_TYPE::R8 => TypeSignature::R8,
            ELEMENT_TYPE::STRING => TypeSignature::String,
            ELEMENT_TYPE::OBJECT => TypeSignature::Object,
            ELEMENT_TYPE::I => TypeSignature::I,
            ELEMENT_TYPE::U => TypeSignature::U,
            ELEMENT_TYPE::TYPEDBYREF => TypeSignature::TypedByRef,
            ELEMENT_TYPE::PTR => {
                self.parse_custom_mods()?;
                TypeSignature::Ptr(Box::new(self.parse_type()?))
            }
            ELEMENT_TYPE::BYREF => TypeSignature::ByRef(Box::new(self.parse_type()?)),
            ELEMENT_TYPE::VALUETYPE => {
                TypeSignature::ValueType(self.parser.read_compressed_token()?)
            }
            ELEMENT_TYPE::CLASS => TypeSignature::Class(self.parser.read_compressed_token()?),
            ELEMENT_TYPE::VAR => {
                TypeSignature::GenericParamType(self.parser.read_compressed_uint()?)
            }
            ELEMENT_TYPE::MVAR => {
                TypeSignature::GenericParamMethod(self.parser.read_compressed_uint()?)
            }
            ELEMENT_TYPE::ARRAY => {
                let elem_type = self.parse_type()?;
                let rank = self.parser.read_compressed_uint()?;

                // Sizes and lower bounds do not take part in identity
                let num_sizes = self.parser.read_compressed_uint()?;
                for _ in 0..num_sizes {
                    self.parser.read_compressed_uint()?;
                }
                let num_lo_bounds = self.parser.read_compressed_uint()?;
                for _ in 0..num_lo_bounds {
                    self.parser.read_compressed_int()?;
                }

                TypeSignature::Array(Box::new(elem_type), rank)
            }
            ELEMENT_TYPE::GENERICINST => {
                let peek_byte = self.parser.peek_byte()?;
                if peek_byte != ELEMENT_TYPE::CLASS && peek_byte != ELEMENT_TYPE::VALUETYPE {
                    return Err(malformed_error!(
                        "GENERICINST - Next byte is not TYPE_CLASS or TYPE_VALUE - {}",
                        peek_byte
                    ));
                }

                let base_type = self.parse_type()?;
                let arg_count = self.parser.read_compressed_uint()?;

                let mut type_args = Vec::with_capacity(arg_count.min(64) as usize);
                for _ in 0..arg_count {
                    type_args.push(self.parse_type()?);
                }

                TypeSignature::GenericInst(Box::new(base_type), type_args)
            }
            ELEMENT_TYPE::FNPTR => TypeSignature::FnPtr(Box::new(self.parse_method_signature()?)),
            ELEMENT_TYPE::SZARRAY => {
                self.parse_custom_mods()?;
                TypeSignature::SzArray(Box::new(self.parse_type()?))
            }
            ELEMENT_TYPE::CMOD_REQD | ELEMENT_TYPE::CMOD_OPT => {
                // A modifier in type position applies to the type that follows it
                self.parser.read_compressed_token()?;
                self.depth -= 1;
                return self.parse_type();
            }
            ELEMENT_TYPE::PINNED => {
                self.depth -= 1;
                return self.parse_type();
            }
            _ => {
                return Err(malformed_error!(
                    "Unsupported ELEMENT_TYPE - {}",
                    current_byte
                ))
            }
        };

        self.depth -= 1;
        Ok(result)
    }

    fn parse_custom_mods(&mut self) -> Result<Vec<CustomModifier>> {
        let mut mods = Vec::new();

        while self.parser.has_more_data() {
            let next_byte = self.parser.peek_byte()?;
            if next_byte != ELEMENT_TYPE::CMOD_OPT && next_byte != ELEMENT_TYPE::CMOD_REQD {
                break;
            }

            self.parser.advance()?;

            mods.push(CustomModifier {
                is_required: next_byte == ELEMENT_TYPE::CMOD_REQD,
                modifier_type: self.parser.read_compressed_token()?,
            });
        }

        Ok(mods)
    }

    fn parse_param(&mut self) -> Result<SignatureParameter> {
        let modifiers = self.parse_custom_mods()?;

        let mut by_ref = false;
        if self.parser.peek_byte()? == ELEMENT_TYPE::BYREF {
            self.parser.advance()?;
            by_ref = true;
        }

        Ok(SignatureParameter {
            modifiers,
            by_ref,
            base: self.parse_type()?,
        })
    }

    /// Parse a method signature
    ///
    /// # Errors
    /// Returns an error if the blob is truncated or contains unknown element types
    pub fn parse_method_signature(&mut self) -> Result<SignatureMethod> {
        let convention_byte = self.parser.read_le::<u8>()?;
        let has_this = convention_byte & SIGNATURE_HEADER::HAS_THIS != 0;
        let explicit_this = convention_byte & SIGNATURE_HEADER::EXPLICIT_THIS != 0;
        let vararg = convention_byte & 0x0F == SIGNATURE_HEADER::VARARG;

        let param_count_generic = if convention_byte & SIGNATURE_HEADER::GENERIC != 0 {
            self.parser.read_compressed_uint()?
        } else {
            0
        };
        let param_count = self.parser.read_compressed_uint()?;
        let return_type = self.parse_param()?;

        let mut params = Vec::with_capacity(param_count.min(64) as usize);
        for _ in 0..param_count {
            if self.parser.peek_byte()? == ELEMENT_TYPE::SENTINEL {
                // Trailing vararg types of a call site, not part of the declaration
                break;
            }

            params.push(self.parse_param()?);
        }

        Ok(SignatureMethod {
            has_this,
            explicit_this,
            vararg,
            param_count_generic,
            return_type,
            params,
        })
    }

    /// Parse a field signature
    ///
    /// # Errors
    /// Returns an error if the blob does not start with the field marker or is truncated
    pub fn parse_field_signature(&mut self) -> Result<SignatureField> {
        let head_byte = self.parser.read_le::<u8>()?;
        if head_byte != SIGNATURE_HEADER::FIELD {
            return Err(malformed_error!(
                "SignatureField - invalid start - {}",
                head_byte
            ));
        }

        let modifiers = self.parse_custom_mods()?;
        let base = self.parse_type()?;

        Ok(SignatureField { modifiers, base })
    }

    /// Parse a property signature
    ///
    /// # Errors
    /// Returns an error if the blob does not start with the property marker or is truncated
    pub fn parse_property_signature(&mut self) -> Result<SignatureProperty> {
        let head_byte = self.parser.read_le::<u8>()?;
        if (head_byte & SIGNATURE_HEADER::PROPERTY) == 0 {
            return Err(malformed_error!(
                "SignatureProperty - invalid start - {}",
                head_byte
            ));
        }

        let has_this = (head_byte & SIGNATURE_HEADER::HAS_THIS) != 0;

        let param_count = self.parser.read_compressed_uint()?;
        let modifiers = self.parse_custom_mods()?;
        let base = self.parse_type()?;

        let mut params = Vec::with_capacity(param_count.min(64) as usize);
        for _ in 0..param_count {
            params.push(self.parse_param()?);
        }

        Ok(SignatureProperty {
            has_this,
            modifiers,
            base,
            params,
        })
    }

    /// Parse a `TypeSpec` signature
    ///
    /// # Errors
    /// Returns an error if the blob is truncated or contains unknown element types
    pub fn parse_type_spec_signature(&mut self) -> Result<SignatureTypeSpec> {
        Ok(SignatureTypeSpec {
            base: self.parse_type()?,
        })
    }

    /// Parse a `MethodSpec` signature
    ///
    /// # Errors
    /// Returns an error if the blob does not start with the instantiation marker or is truncated
    pub fn parse_method_spec_signature(&mut self) -> Result<SignatureMethodSpec> {
        let head_byte = self.parser.read_le::<u8>()?;
        if head_byte != SIGNATURE_HEADER::GENERIC_INST {
            return Err(malformed_error!(
                "SignatureMethodSpec - invalid start - {}",
                head_byte
            ));
        }

        let arg_count = self.parser.read_compressed_uint()?;
        let mut generic_args = Vec::with_capacity(arg_count.min(64) as usize);
        for _ in 0..arg_count {
            generic_args.push(self.parse_type()?);
        }

        Ok(SignatureMethodSpec { generic_args })
    }
}

/// Returns the first modifier whose type is `token`, if any.
#[must_use]
pub fn find_modifier(modifiers: &[CustomModifier], token: Token) -> Option<&CustomModifier> {
    modifiers.iter().find(|m| m.modifier_type == token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifiers_are_kept_on_parameters() {
        // instance void (modreq([TypeRef 2]) int32&)
        let mut parser = SignatureParser::new(&[0x20, 0x01, 0x01, 0x1F, 0x09, 0x10, 0x08]);
        let method = parser.parse_method_signature().unwrap();

        let param = &method.params[0];
        assert!(param.by_ref);
        assert_eq!(param.base, TypeSignature::I4);
        assert_eq!(
            param.modifiers,
            vec![CustomModifier {
                is_required: true,
                modifier_type: Token::new(0x0100_0002),
            }]
        );
        assert!(find_modifier(&param.modifiers, Token::new(0x0100_0002)).is_some());
        assert_eq!(param.to_type(), TypeSignature::ByRef(Box::new(TypeSignature::I4)));
    }

    #[test]
    fn multi_dimensional_arrays_keep_rank() {
        // int32[,] with two sizes and no bounds
        let mut parser = SignatureParser::new(&[0x14, 0x08, 0x02, 0x02, 0x03, 0x04, 0x00]);
        let spec = parser.parse_type_spec_signature().unwrap();
        assert_eq!(spec.base, TypeSignature::Array(Box::new(TypeSignature::I4), 2));
    }

    #[test]
    fn recursion_is_limited() {
        let data = vec![ELEMENT_TYPE::SZARRAY; 200];
        let mut parser = SignatureParser::new(&data);
        assert!(matches!(
            parser.parse_type_spec_signature(),
            Err(RecursionLimit(_))
        ));
    }

    #[test]
    fn invalid_element_type() {
        let mut parser = SignatureParser::new(&[0x17]);
        assert!(parser.parse_type_spec_signature().is_err());
    }
}
