// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]
//#![deny(unsafe_code)]
// - 'file/image.rs' maps module files into memory

//! # dotdoc
//!
//! A reflection-free metadata model of compiled .NET modules, built for documentation
//! generators. `dotdoc` decodes ECMA-335 metadata, materializes types and members on demand and
//! answers the structural questions a documentation tool asks: what a type declares and
//! inherits, which interface member a method implements, whether a generic argument satisfies
//! its constraints, which extension methods apply to a type, and which member a
//! `M:N.C.Method(System.Int32)` cross-reference names.
//!
//! ## Features
//!
//! - **Isolated loading** - modules are decoded, never executed; a [`MetadataUniverse`] owns
//!   them and releases them on disposal
//! - **Weak retention** - the [`MetadataProvider`] cache never keeps a module resident
//! - **Structural identity** - the same type reached through a `TypeRef`, a `TypeDef` or a
//!   nested generic context is one object
//! - **Generics** - variance, constraints, substitution, open and closed forms
//! - **Code references** - formatting and resolution of documentation reference strings
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dotdoc::prelude::*;
//!
//! let universe = MetadataUniverse::builder()
//!     .probe_directory("bin")
//!     .build()?;
//! for module in universe.load_all()? {
//!     println!("{}", module.assembly_name());
//! }
//!
//! let provider = universe.provider();
//! if let Some(Member::Method(method)) = provider.resolve_member("M:App.Program.Main") {
//!     println!("{} returns {}", method.name(), method.return_type().unwrap());
//! }
//! # Ok::<(), dotdoc::Error>(())
//! ```
//!
//! ### Building modules in memory
//!
//! ```rust
//! use dotdoc::prelude::*;
//!
//! let mut module = ModuleBuilder::new("Shapes");
//! let shape = TypeBuilder::interface("Shapes", "IShape").build(&mut module)?;
//! let circle = TypeBuilder::class("Shapes", "Circle")
//!     .implements(TypeSignature::Class(shape))
//!     .build(&mut module)?;
//! MethodBuilder::constructor()
//!     .parameter(("radius", TypeSignature::R8))
//!     .build(&mut module, circle)?;
//! let module = module.build()?;
//!
//! let provider = MetadataProvider::new();
//! provider.register_module(&module);
//!
//! let circle = provider.find_type_by_full_name("Shapes.Circle").unwrap();
//! let shape = provider.find_type_by_full_name("Shapes.IShape").unwrap();
//! assert!(shape.is_assignable_from(&circle));
//!
//! let ctor = &circle.constructors()[0];
//! assert_eq!(ctor.code_reference(), "M:Shapes.Circle.#ctor(System.Double)");
//! assert_eq!(provider.resolve_member(&ctor.code_reference()), Some(Member::from(ctor.clone())));
//! # Ok::<(), dotdoc::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`prelude`] - Convenient re-exports of commonly used types and traits
//! - [`metadata`] - Module decoding, the registry, the type system and code references
//! - [`Error`] and [`Result`] - Error handling
//!
//! Lookups that can legitimately find nothing (unknown names, unresolvable references) return
//! `Option`; [`Error`] is reserved for invalid arguments, missing files, disposed universes,
//! unloaded modules and undecodable images.
//!
//! ## Logging
//!
//! `dotdoc` emits [`tracing`](https://docs.rs/tracing) events and spans (module loading,
//! registration, cache eviction, unbound references). It never installs a subscriber.
//!
//! ## Standards Compliance
//!
//! `dotdoc` reads metadata as laid out by the **ECMA-335 specification** (6th edition).
//!
//! - [ECMA-335 Standard](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf) - Official CLI specification
#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;
pub(crate) mod file;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use dotdoc::prelude::*;
///
/// let provider = MetadataProvider::new();
/// let string = provider.find_type_by_full_name("System.String").unwrap();
/// assert_eq!(string.code_reference(), "T:System.String");
/// ```
pub mod prelude;

/// Decoding, registry, type system and code references of .NET metadata
///
/// # Key Components
///
/// - [`metadata::provider`] - The registry of materialized types and members
/// - [`metadata::typesystem`] - Types, members and their relationships
/// - [`metadata::coderef`] - Documentation code references
/// - [`metadata::universe`] - Isolated loading contexts
/// - [`metadata::builder`] - In-memory module construction
/// - [`metadata::tables`], [`metadata::streams`], [`metadata::signatures`] - The raw ECMA-335
///   layer
pub mod metadata;

/// `dotdoc` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
///
/// # Examples
///
/// ```rust,no_run
/// use dotdoc::{metadata::module::ModuleRc, Result};
///
/// fn load(path: &str) -> Result<ModuleRc> {
///     dotdoc::metadata::module::Module::from_path(path)
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// `dotdoc` Error type
///
/// # Examples
///
/// ```rust,no_run
/// use dotdoc::{metadata::universe::MetadataUniverse, Error};
///
/// let universe = MetadataUniverse::builder().build()?;
/// match universe.load_from_path("missing.dll") {
///     Ok(module) => println!("loaded {}", module.assembly_name()),
///     Err(Error::NotFound(path)) => println!("no such module: {}", path.display()),
///     Err(error) => println!("error: {error}"),
/// }
/// # Ok::<(), dotdoc::Error>(())
/// ```
pub use error::Error;

/// Low-level access to module images.
///
/// - [`File`] - A PE or bare metadata image, memory-mapped or in memory
/// - [`Parser`] - A bounds-checked cursor over metadata bytes
pub use file::{parser::Parser, File};

/// The registry of materialized metadata objects, see [`metadata::provider::MetadataProvider`]
pub use metadata::provider::MetadataProvider;

/// Isolated loading contexts, see [`metadata::universe::MetadataUniverse`]
pub use metadata::universe::MetadataUniverse;
