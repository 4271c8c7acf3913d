//! Attribute bitmasks of types, members, parameters and generic parameters (ECMA-335 II.23.1).
//!
//! Every table that carries a `Flags` column gets a `bitflags` type here. Multi-bit fields such as
//! visibility or variance are exposed through masks and small accessor methods, since a plain
//! `contains` check on them would be wrong.

use bitflags::bitflags;

/// Bitmask for the visibility bits of [`TypeAttributes`]
pub const TYPE_VISIBILITY_MASK: u32 = 0x0007;
/// Bitmask for the access bits of [`MethodAttributes`] and [`FieldAttributes`]
pub const MEMBER_ACCESS_MASK: u16 = 0x0007;
/// Bitmask for the variance bits of [`GenericParamAttributes`]
pub const VARIANCE_MASK: u16 = 0x0003;
/// Bitmask for the special constraint bits of [`GenericParamAttributes`]
pub const SPECIAL_CONSTRAINT_MASK: u16 = 0x003C;

bitflags! {
    /// Flags of a `TypeDef` row
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TypeAttributes: u32 {
        /// Type is not visible outside its assembly
        const NOT_PUBLIC = 0x0000_0000;
        /// Type is visible everywhere
        const PUBLIC = 0x0000_0001;
        /// Nested type with public visibility
        const NESTED_PUBLIC = 0x0000_0002;
        /// Nested type with private visibility
        const NESTED_PRIVATE = 0x0000_0003;
        /// Nested type visible to the enclosing type and its sub-types
        const NESTED_FAMILY = 0x0000_0004;
        /// Nested type visible within the assembly
        const NESTED_ASSEMBLY = 0x0000_0005;
        /// Nested type visible to sub-types within the assembly
        const NESTED_FAM_AND_ASSEM = 0x0000_0006;
        /// Nested type visible to sub-types or within the assembly
        const NESTED_FAM_OR_ASSEM = 0x0000_0007;
        /// Fields are laid out sequentially
        const SEQUENTIAL_LAYOUT = 0x0000_0008;
        /// Field offsets are explicit
        const EXPLICIT_LAYOUT = 0x0000_0010;
        /// Type is an interface
        const INTERFACE = 0x0000_0020;
        /// Type cannot be instantiated
        const ABSTRACT = 0x0000_0080;
        /// Type cannot be derived from
        const SEALED = 0x0000_0100;
        /// Name carries special meaning
        const SPECIAL_NAME = 0x0000_0400;
        /// Type is imported from COM
        const IMPORT = 0x0000_1000;
        /// Type is serializable
        const SERIALIZABLE = 0x0000_2000;
        /// Static constructor may run lazily
        const BEFORE_FIELD_INIT = 0x0010_0000;
        /// The runtime treats the name specially
        const RT_SPECIAL_NAME = 0x0000_0800;
    }
}

impl TypeAttributes {
    /// The declared visibility of the type
    #[must_use]
    pub fn visibility(&self) -> Visibility {
        match self.bits() & TYPE_VISIBILITY_MASK {
            0x1 | 0x2 => Visibility::Public,
            0x3 => Visibility::Private,
            0x4 => Visibility::Protected,
            0x6 => Visibility::PrivateProtected,
            0x7 => Visibility::ProtectedInternal,
            _ => Visibility::Internal,
        }
    }

    /// Returns true for any of the `NESTED_*` visibilities
    #[must_use]
    pub fn is_nested(&self) -> bool {
        self.bits() & TYPE_VISIBILITY_MASK > 1
    }
}

bitflags! {
    /// Flags of a `MethodDef` row
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MethodAttributes: u16 {
        /// Member not referenceable
        const COMPILER_CONTROLLED = 0x0000;
        /// Accessible only by the parent type
        const PRIVATE = 0x0001;
        /// Accessible by sub-types only in this assembly
        const FAM_AND_ASSEM = 0x0002;
        /// Accessible by anyone in the assembly
        const ASSEM = 0x0003;
        /// Accessible only by type and sub-types
        const FAMILY = 0x0004;
        /// Accessible by sub-types anywhere, plus anyone in the assembly
        const FAM_OR_ASSEM = 0x0005;
        /// Accessible by anyone who has visibility to this scope
        const PUBLIC = 0x0006;
        /// Defined on type, else per instance
        const STATIC = 0x0010;
        /// Method cannot be overridden
        const FINAL = 0x0020;
        /// Method is virtual
        const VIRTUAL = 0x0040;
        /// Method hides by name+sig, else just by name
        const HIDE_BY_SIG = 0x0080;
        /// Method always gets a new slot in the vtable
        const NEW_SLOT = 0x0100;
        /// Method can only be overriden if also accessible
        const STRICT = 0x0200;
        /// Method does not provide an implementation
        const ABSTRACT = 0x0400;
        /// Method is special
        const SPECIAL_NAME = 0x0800;
        /// The runtime treats the name specially
        const RT_SPECIAL_NAME = 0x1000;
        /// Implementation is forwarded through PInvoke
        const PINVOKE_IMPL = 0x2000;
    }
}

impl MethodAttributes {
    /// The declared accessibility of the method
    #[must_use]
    pub fn visibility(&self) -> Visibility {
        Visibility::from_member_access(self.bits())
    }
}

bitflags! {
    /// Flags of a `Field` row
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FieldAttributes: u16 {
        /// Member not referenceable
        const COMPILER_CONTROLLED = 0x0000;
        /// Accessible only by the parent type
        const PRIVATE = 0x0001;
        /// Accessible by sub-types only in this assembly
        const FAM_AND_ASSEM = 0x0002;
        /// Accessible by anyone in the assembly
        const ASSEM = 0x0003;
        /// Accessible only by type and sub-types
        const FAMILY = 0x0004;
        /// Accessible by sub-types anywhere, plus anyone in the assembly
        const FAM_OR_ASSEM = 0x0005;
        /// Accessible by anyone who has visibility to this scope
        const PUBLIC = 0x0006;
        /// Defined on type, else per instance
        const STATIC = 0x0010;
        /// Field can only be initialized, not written after
        const INIT_ONLY = 0x0020;
        /// Value is a compile time constant
        const LITERAL = 0x0040;
        /// Field does not have to be serialized
        const NOT_SERIALIZED = 0x0080;
        /// Field is special
        const SPECIAL_NAME = 0x0200;
        /// Runtime should check the name encoding
        const RT_SPECIAL_NAME = 0x0400;
        /// Field has a default value
        const HAS_DEFAULT = 0x8000;
    }
}

impl FieldAttributes {
    /// The declared accessibility of the field
    #[must_use]
    pub fn visibility(&self) -> Visibility {
        Visibility::from_member_access(self.bits())
    }
}

bitflags! {
    /// Flags of a `Param` row
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ParamAttributes: u16 {
        /// Parameter is an input
        const IN = 0x0001;
        /// Parameter is an output
        const OUT = 0x0002;
        /// Parameter is optional
        const OPTIONAL = 0x0010;
        /// Parameter has a default value
        const HAS_DEFAULT = 0x1000;
        /// Parameter has marshalling information
        const HAS_FIELD_MARSHAL = 0x2000;
    }
}

bitflags! {
    /// Flags of a `GenericParam` row
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct GenericParamAttributes: u16 {
        /// Parameter is covariant
        const COVARIANT = 0x0001;
        /// Parameter is contravariant
        const CONTRAVARIANT = 0x0002;
        /// Argument must be a reference type
        const REFERENCE_TYPE_CONSTRAINT = 0x0004;
        /// Argument must be a non-nullable value type
        const NOT_NULLABLE_VALUE_TYPE_CONSTRAINT = 0x0008;
        /// Argument must have a public parameterless constructor
        const DEFAULT_CONSTRUCTOR_CONSTRAINT = 0x0010;
        /// Argument may be a by-ref-like type
        const ALLOW_BY_REF_LIKE = 0x0020;
    }
}

bitflags! {
    /// Flags of a `Property` row
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PropertyAttributes: u16 {
        /// Property is special
        const SPECIAL_NAME = 0x0200;
        /// The runtime treats the name specially
        const RT_SPECIAL_NAME = 0x0400;
        /// Property has a default value
        const HAS_DEFAULT = 0x1000;
    }
}

bitflags! {
    /// Flags of an `Event` row
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct EventAttributes: u16 {
        /// Event is special
        const SPECIAL_NAME = 0x0200;
        /// The runtime treats the name specially
        const RT_SPECIAL_NAME = 0x0400;
    }
}

bitflags! {
    /// Roles of a `MethodSemantics` row
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MethodSemanticsAttributes: u16 {
        /// Property setter
        const SETTER = 0x0001;
        /// Property getter
        const GETTER = 0x0002;
        /// Other method of a property or event
        const OTHER = 0x0004;
        /// Event add method
        const ADD_ON = 0x0008;
        /// Event remove method
        const REMOVE_ON = 0x0010;
        /// Event raise method
        const FIRE = 0x0020;
    }
}

/// Accessibility of a type or member, in source language terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Visibility {
    /// Accessible only within the declaring type
    Private,
    /// Accessible to sub-types within the same assembly
    PrivateProtected,
    /// Accessible within the same assembly
    Internal,
    /// Accessible to sub-types
    Protected,
    /// Accessible to sub-types or within the same assembly
    ProtectedInternal,
    /// Accessible everywhere
    Public,
}

impl Visibility {
    fn from_member_access(bits: u16) -> Self {
        match bits & MEMBER_ACCESS_MASK {
            0x2 => Visibility::PrivateProtected,
            0x3 => Visibility::Internal,
            0x4 => Visibility::Protected,
            0x5 => Visibility::ProtectedInternal,
            0x6 => Visibility::Public,
            _ => Visibility::Private,
        }
    }

    /// Returns true if the member is part of the documented surface outside its assembly.
    #[must_use]
    pub fn is_externally_visible(&self) -> bool {
        matches!(
            self,
            Visibility::Public | Visibility::Protected | Visibility::ProtectedInternal
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_visibility() {
        assert_eq!(TypeAttributes::PUBLIC.visibility(), Visibility::Public);
        assert_eq!(TypeAttributes::NOT_PUBLIC.visibility(), Visibility::Internal);
        assert_eq!(
            (TypeAttributes::NESTED_FAMILY | TypeAttributes::SEALED).visibility(),
            Visibility::Protected
        );
        assert!(TypeAttributes::NESTED_PRIVATE.is_nested());
        assert!(!TypeAttributes::PUBLIC.is_nested());
    }

    #[test]
    fn member_visibility() {
        let flags = MethodAttributes::PUBLIC | MethodAttributes::VIRTUAL;
        assert_eq!(flags.visibility(), Visibility::Public);
        assert_eq!(MethodAttributes::FAMILY.visibility(), Visibility::Protected);
        assert_eq!(FieldAttributes::PRIVATE.visibility(), Visibility::Private);
        assert!(Visibility::ProtectedInternal.is_externally_visible());
        assert!(!Visibility::Internal.is_externally_visible());
    }
}
