//! # dotdoc Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the dotdoc library. Import this module to get quick access to the essential
//! types for documenting .NET modules.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all dotdoc operations
pub use crate::Error;

/// The result type used throughout dotdoc
pub use crate::Result;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// The registry of materialized types and members
pub use crate::metadata::provider::{AssemblyResolver, MetadataProvider};

/// Isolated loading contexts
pub use crate::metadata::universe::{MetadataUniverse, MetadataUniverseBuilder};

/// Decoded modules
pub use crate::metadata::module::{Module, ModuleId, ModuleRc};

/// Low-level file parsing utilities
pub use crate::{File, Parser};

// ================================================================================================
// Metadata System - Core Types
// ================================================================================================

/// Metadata token type for referencing table entries
pub use crate::metadata::token::Token;

/// Raw handles the model is materialized from
pub use crate::metadata::handle::{
    GenericOwner, Handle, MemberHandle, MethodHandle, ParameterHandle, TypeHandle,
};

/// Structural handle comparison
pub use crate::metadata::comparer::StructuralComparer;

/// Constant values of fields and parameters
pub use crate::metadata::constant::ConstantValue;

/// Attribute bitmasks
pub use crate::metadata::flags::{
    EventAttributes, FieldAttributes, GenericParamAttributes, MethodAttributes,
    ParamAttributes, PropertyAttributes, TypeAttributes, Visibility,
};

// ================================================================================================
// Type System
// ================================================================================================

/// Types, members and their relationships
pub use crate::metadata::typesystem::{
    get_inherited_member, Event, EventRc, ExtensionProperty, Field, FieldRc, Member, Method,
    MethodKind, MethodRc, Parameter, ParameterRc, Property, PropertyRc, RefKind, Type, TypeKind,
    TypeModifier, TypeRc, Variance,
};

/// Signature trees
pub use crate::metadata::signatures::{SignatureMethod, SignatureParameter, TypeSignature};

// ================================================================================================
// Code References
// ================================================================================================

/// Documentation code references
pub use crate::metadata::coderef::{CodeReference, ReferenceKind, TypeName};

// ================================================================================================
// Module Construction
// ================================================================================================

/// In-memory module builders
pub use crate::metadata::builder::{
    EventBuilder, FieldBuilder, GenericParameterBuilder, MethodBuilder, MethodId,
    ModuleBuilder, ParameterBuilder, PropertyBuilder, TypeBuilder,
};
