use std::path::PathBuf;

use thiserror::Error;

use crate::metadata::token::Token;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! out_of_bounds_error {
    () => {
        crate::Error::OutOfBounds
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// The variants fall into two groups. Decoding errors describe a module image that could not be
/// read. Model errors describe a misuse of the metadata model or its loader and are surfaced to the
/// caller as distinguished, fatal conditions.
///
/// Absence is not an error: lookups such as
/// [`crate::metadata::provider::MetadataProvider::find_type_by_full_name`] and
/// [`crate::metadata::coderef::CodeReference::resolve`] return `None` for names that do not bind.
///
/// # Error Categories
///
/// ## Decoding Errors
/// - [`Error::Malformed`] - Corrupted or invalid metadata structure
/// - [`Error::OutOfBounds`] - Attempted to read beyond the end of a buffer
/// - [`Error::NotSupported`] - Unsupported file format or feature
/// - [`Error::Empty`] - Empty input provided
/// - [`Error::RecursionLimit`] - A signature nested deeper than allowed
///
/// ## I/O and External Errors
/// - [`Error::FileError`] - Filesystem I/O errors
/// - [`Error::GoblinErr`] - PE parsing errors from goblin crate
///
/// ## Model Errors
/// - [`Error::InvalidArgument`] - A required input was empty or otherwise unusable
/// - [`Error::NotFound`] - A module path does not exist
/// - [`Error::Disposed`] - A universe was used after teardown
/// - [`Error::UnsupportedMember`] - A raw handle has no metadata variant
/// - [`Error::Unloaded`] - The module backing a metadata object is no longer resident
///
/// # Examples
///
/// ```rust,no_run
/// use dotdoc::{Error, prelude::*};
///
/// let universe = MetadataUniverse::builder().build()?;
/// match universe.load_from_path("missing.dll") {
///     Ok(module) => println!("loaded {}", module.name()),
///     Err(Error::NotFound(path)) => eprintln!("no such module: {}", path.display()),
///     Err(e) => eprintln!("other error: {}", e),
/// }
/// # Ok::<(), dotdoc::Error>(())
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The file is damaged and could not be parsed.
    ///
    /// This error indicates that the metadata structure is corrupted or doesn't conform to
    /// ECMA-335. The error includes the source location where the malformation was detected.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing the file.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// This file type is not supported.
    ///
    /// Raised for inputs that are neither a PE image with a CLI header nor a bare metadata
    /// image, and for metadata that uses tables this crate does not know.
    #[error("This file type is not supported")]
    NotSupported,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),

    /// Error from the goblin crate during PE parsing.
    #[error("{0}")]
    GoblinErr(#[from] goblin::error::Error),

    /// A token does not name a row of the table it points into.
    #[error("Failed to find a metadata row for - {0}")]
    TokenNotFound(Token),

    /// Recursion limit reached.
    ///
    /// Signature decoding and type walks enforce a maximum depth so that hostile or cyclic
    /// metadata cannot overflow the stack. The associated value is the limit that was reached.
    #[error("Reach the maximum recursion level allowed - {0}")]
    RecursionLimit(usize),

    /// A required argument was null, empty or otherwise unusable.
    ///
    /// Raised immediately at the call boundary, before any work is done.
    #[error("Invalid argument - {0}")]
    InvalidArgument(String),

    /// The module file does not exist.
    #[error("Module not found - {}", .0.display())]
    NotFound(PathBuf),

    /// The universe has been torn down.
    ///
    /// Every operation on a [`crate::metadata::universe::MetadataUniverse`] fails with this
    /// error once [`crate::metadata::universe::MetadataUniverse::dispose`] has run.
    #[error("The metadata universe has been disposed")]
    Disposed,

    /// A raw handle of a kind the metadata model has no variant for.
    ///
    /// Function pointers and typed references decode fine as signatures, but cannot be turned
    /// into a [`crate::metadata::typesystem::Type`].
    #[error("Unsupported member - {0}")]
    UnsupportedMember(String),

    /// The module that backs a metadata object is no longer resident.
    #[error("The owning module has been unloaded")]
    Unloaded,
}
