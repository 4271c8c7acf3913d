use crate::metadata::token::Token;

/// A decoded type of a signature blob (ECMA-335 II.23.2.12).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum TypeSignature {
    Void,
    Boolean,
    Char,
    I1,
    U1,
    I2,
    U2,
    I4,
    U4,
    I8,
    U8,
    R4,
    R8,
    String,
    Object,
    I,
    U,
    TypedByRef,
    /// TypeDefOrRefOrSpecEncoded
    Class(Token),
    /// TypeDefOrRefOrSpecEncoded
    ValueType(Token),
    /// Open type (`Class` or `ValueType`) and its arguments
    GenericInst(Box<TypeSignature>, Vec<TypeSignature>),
    /// Generic parameter of the enclosing type, by flattened number
    GenericParamType(u32),
    /// Generic parameter of the enclosing method, by number
    GenericParamMethod(u32),
    SzArray(Box<TypeSignature>),
    /// Multi-dimensional array of the given rank; sizes and bounds are not kept
    Array(Box<TypeSignature>, u32),
    Ptr(Box<TypeSignature>),
    ByRef(Box<TypeSignature>),
    FnPtr(Box<SignatureMethod>),
}

impl TypeSignature {
    /// Name of the `System` type a built-in element type stands for.
    #[must_use]
    pub fn primitive_name(&self) -> Option<&'static str> {
        Some(match self {
            TypeSignature::Void => "Void",
            TypeSignature::Boolean => "Boolean",
            TypeSignature::Char => "Char",
            TypeSignature::I1 => "SByte",
            TypeSignature::U1 => "Byte",
            TypeSignature::I2 => "Int16",
            TypeSignature::U2 => "UInt16",
            TypeSignature::I4 => "Int32",
            TypeSignature::U4 => "UInt32",
            TypeSignature::I8 => "Int64",
            TypeSignature::U8 => "UInt64",
            TypeSignature::R4 => "Single",
            TypeSignature::R8 => "Double",
            TypeSignature::String => "String",
            TypeSignature::Object => "Object",
            TypeSignature::I => "IntPtr",
            TypeSignature::U => "UIntPtr",
            TypeSignature::TypedByRef => "TypedReference",
            _ => return None,
        })
    }
}

/// A custom modifier in front of a parameter or field type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CustomModifier {
    /// `modreq` if set, `modopt` otherwise
    pub is_required: bool,
    /// TypeDefOrRef token of the modifier type
    pub modifier_type: Token,
}

/// A parameter or return type of a method or property signature
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignatureParameter {
    /// Modifiers that precede the type
    pub modifiers: Vec<CustomModifier>,
    /// The parameter is passed by reference
    pub by_ref: bool,
    /// The parameter type, without the by-ref marker
    pub base: TypeSignature,
}

impl SignatureParameter {
    /// Creates an unmodified parameter of `base`.
    #[must_use]
    pub fn new(base: TypeSignature) -> Self {
        SignatureParameter {
            modifiers: Vec::new(),
            by_ref: false,
            base,
        }
    }

    /// Creates an unmodified by-ref parameter of `base`.
    #[must_use]
    pub fn by_ref(base: TypeSignature) -> Self {
        SignatureParameter {
            modifiers: Vec::new(),
            by_ref: true,
            base,
        }
    }

    /// The parameter type with the by-ref marker folded into the tree.
    #[must_use]
    pub fn to_type(&self) -> TypeSignature {
        if self.by_ref {
            TypeSignature::ByRef(Box::new(self.base.clone()))
        } else {
            self.base.clone()
        }
    }
}

/// A method signature (`MethodDefSig`, `MethodRefSig`, `StandAloneMethodSig`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignatureMethod {
    /// The method has an implicit `this`
    pub has_this: bool,
    /// The `this` pointer is listed in the parameters
    pub explicit_this: bool,
    /// Variable argument calling convention
    pub vararg: bool,
    /// Number of generic parameters of the method
    pub param_count_generic: u32,
    /// Return type
    pub return_type: SignatureParameter,
    /// Fixed parameters
    pub params: Vec<SignatureParameter>,
}

impl Default for SignatureMethod {
    fn default() -> Self {
        SignatureMethod {
            has_this: false,
            explicit_this: false,
            vararg: false,
            param_count_generic: 0,
            return_type: SignatureParameter::new(TypeSignature::Void),
            params: Vec::new(),
        }
    }
}

/// A field signature
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignatureField {
    /// Modifiers that precede the type
    pub modifiers: Vec<CustomModifier>,
    /// The field type
    pub base: TypeSignature,
}

/// A property signature
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignatureProperty {
    /// The property belongs to an instance
    pub has_this: bool,
    /// Modifiers that precede the type
    pub modifiers: Vec<CustomModifier>,
    /// The property type
    pub base: TypeSignature,
    /// Index parameters
    pub params: Vec<SignatureParameter>,
}

/// A `TypeSpec` signature
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignatureTypeSpec {
    /// The specified type
    pub base: TypeSignature,
}

/// A `MethodSpec` instantiation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignatureMethodSpec {
    /// The method's type arguments
    pub generic_args: Vec<TypeSignature>,
}

/// The signature of a `MemberRef`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SignatureMemberRef {
    /// Reference to a field
    Field(SignatureField),
    /// Reference to a method
    Method(SignatureMethod),
}
