//! The metadata model of .NET modules.
//!
//! Modules are decoded from PE images or bare ECMA-335 metadata images, or built in memory, into
//! [`tables`] of rows. The [`provider`] materializes types and members from raw [`handle`]s on
//! demand and caches them per module; the [`typesystem`] objects it hands out answer structural
//! questions (members, inheritance, generic shape, assignability) without executing anything.
//!
//! # Key Components
//!
//! - [`module`] - A decoded module and its lookup indexes
//! - [`provider`] - The handle-to-object registry with weak module retention
//! - [`typesystem`] - Types, members, decorators, generics and relationships
//! - [`comparer`] - Structural equality of raw handles
//! - [`coderef`] - Documentation code references and their resolution
//! - [`universe`] - Isolated loading from paths and probe directories
//! - [`builder`] - Programmatic module construction and serialisation
//! - [`corlib`] - The synthesized core runtime library
//!
//! # Examples
//!
//! ```rust
//! use dotdoc::metadata::{
//!     builder::{MethodBuilder, ModuleBuilder, TypeBuilder},
//!     provider::MetadataProvider,
//!     signatures::TypeSignature,
//! };
//!
//! let mut module = ModuleBuilder::new("Geometry");
//! let point = TypeBuilder::value_type("Geometry", "Point").build(&mut module)?;
//! MethodBuilder::new("Length")
//!     .returns(TypeSignature::R8)
//!     .build(&mut module, point)?;
//! let module = module.build()?;
//!
//! let provider = MetadataProvider::new();
//! provider.register_module(&module);
//!
//! let point = provider.find_type_by_full_name("Geometry.Point").unwrap();
//! assert!(point.is_value_type());
//! assert_eq!(point.methods()[0].code_reference(), "M:Geometry.Point.Length");
//! # Ok::<(), dotdoc::Error>(())
//! ```

/// Binding of type references and signatures
pub(crate) mod binding;
/// Programmatic module construction
pub mod builder;
/// Documentation code references
pub mod coderef;
/// Structural comparison and canonicalization of handles
pub mod comparer;
/// Values of the `Constant` table
pub mod constant;
/// The synthesized core runtime library
pub mod corlib;
/// Attribute bitmasks
pub mod flags;
/// Raw handles
pub mod handle;
/// Decoded modules
pub mod module;
/// The registry of materialized metadata objects
pub mod provider;
/// Implementation of the root metadata structure
pub mod root;
/// Implementation of method and type signatures
pub mod signatures;
/// Implementation of the metadata streams (heaps and the table stream header)
pub mod streams;
/// Implementation of the .NET metadata tables
pub mod tables;
/// Commonly used metadata token type
pub mod token;
/// Implementation of the .NET type system
pub mod typesystem;
/// Isolated loading contexts
pub mod universe;
