//! Documentation code references.
//!
//! A code reference names a namespace, type or member as `<kind>:<path>`:
//!
//! | Reference                                          | Names                              |
//! |----------------------------------------------------|------------------------------------|
//! | `N:System.Collections`                             | a namespace                        |
//! | ``T:N.Outer`1.Inner``                              | a type, nested types joined by `.` |
//! | `M:N.C.#ctor(System.Int32)`                        | a constructor                      |
//! | ```M:N.C.Select``2(N.List{``0})```                  | a generic method                   |
//! | `M:N.C.op_Implicit(N.C)~System.Int32`              | a conversion operator              |
//! | `P:N.C.Item(System.Int32)`                         | an indexer                         |
//! | `F:N.C.Limit`, `E:N.C.Changed`                     | a field, an event                  |
//!
//! Parameter types use full names with type arguments in braces, `` `n `` and ``` ``n ``` for
//! type and method parameters, `[]`/`[0:,0:]` for arrays, `*` for pointers and `@` for by-refs.
//! Explicit interface implementations encode their interface qualifier with `#` in place of
//! `.`, `<` and `>`.
//!
//! Parsing and resolution never fail loudly: malformed or unmatched references produce `None`,
//! so a batch of cross-references survives one bad entry.
//!
//! # Examples
//!
//! ```rust
//! use dotdoc::metadata::coderef::{CodeReference, ReferenceKind};
//!
//! let reference = CodeReference::parse("M:N.C.Select``2(N.List{``0})").unwrap();
//! assert_eq!(reference.kind(), ReferenceKind::Method);
//! assert_eq!(reference.type_path(), "N.C");
//! assert_eq!(reference.member_name(), Some("Select"));
//! assert_eq!(reference.generic_arity(), Some(2));
//!
//! assert!(CodeReference::is_namespace("N:System.Collections"));
//! assert!(!CodeReference::is_valid("X:Nope"));
//! ```

mod format;
mod parser;
mod resolve;

pub(crate) use format::{event_reference, field_reference, method_reference, property_reference};
pub(crate) use format::type_reference;
pub use parser::{Segment, TypeName};

use std::{fmt, str::FromStr};

use strum::{Display, EnumIter, EnumString};

use crate::{
    metadata::coderef::parser::{split_arity, write_list, ReferenceParser},
    Error,
};

/// The kind prefix of a code reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum ReferenceKind {
    /// `N:`
    #[strum(serialize = "N")]
    Namespace,
    /// `T:`
    #[strum(serialize = "T")]
    Type,
    /// `M:`, methods, constructors and operators
    #[strum(serialize = "M")]
    Method,
    /// `P:`
    #[strum(serialize = "P")]
    Property,
    /// `F:`
    #[strum(serialize = "F")]
    Field,
    /// `E:`
    #[strum(serialize = "E")]
    Event,
}

impl ReferenceKind {
    /// Returns true for the kinds that name a member of a type
    #[must_use]
    pub fn is_member(self) -> bool {
        !matches!(self, ReferenceKind::Namespace | ReferenceKind::Type)
    }
}

/// A parsed code reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CodeReference {
    kind: ReferenceKind,
    /// Namespace and type segments; the declaring type of member references
    path: Vec<String>,
    /// Encoded member name, without the method arity
    member: Option<String>,
    arity: Option<u32>,
    parameters: Option<Vec<TypeName>>,
    return_type: Option<TypeName>,
}

impl CodeReference {
    /// Parses `text`, returning `None` if it is not a well-formed reference.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let (kind, rest) = text.trim().split_once(':')?;
        let kind = ReferenceKind::from_str(kind).ok()?;
        let mut parser = ReferenceParser::new(rest);
        let mut path: Vec<String> = parser.head()?.into_iter().map(str::to_string).collect();

        let mut reference = CodeReference {
            kind,
            path: Vec::new(),
            member: None,
            arity: None,
            parameters: None,
            return_type: None,
        };
        if kind.is_member() {
            if path.len() < 2 {
                return None;
            }
            let member = path.pop()?;
            let (name, arity) = split_arity(&member)?;
            if arity.is_some() && kind != ReferenceKind::Method {
                return None;
            }
            reference.member = Some(name.to_string());
            reference.arity = arity;

            if matches!(kind, ReferenceKind::Method | ReferenceKind::Property)
                && parser.peek() == Some('(')
            {
                reference.parameters = Some(parser.parameters()?);
            }
            if kind == ReferenceKind::Method && parser.eat('~') {
                reference.return_type = Some(parser.type_name()?);
            }
        }
        if !parser.is_done() {
            return None;
        }
        if path.iter().any(|segment| segment.contains("``")) {
            return None;
        }
        reference.path = path;
        Some(reference)
    }

    /// Returns true if `text` is a well-formed reference of any kind
    #[must_use]
    pub fn is_valid(text: &str) -> bool {
        Self::parse(text).is_some()
    }

    /// Returns true if `text` is a well-formed namespace reference
    #[must_use]
    pub fn is_namespace(text: &str) -> bool {
        Self::parse(text).is_some_and(|reference| reference.kind == ReferenceKind::Namespace)
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn kind(&self) -> ReferenceKind {
        self.kind
    }

    /// The namespace of `N:` references, the type of `T:` references and the declaring type
    /// of member references, with `.` between all segments
    #[must_use]
    pub fn type_path(&self) -> String {
        self.path.join(".")
    }

    /// The encoded member name (`#ctor`, `N#IFoo#Bar`)
    #[must_use]
    pub fn member_name(&self) -> Option<&str> {
        self.member.as_deref()
    }

    /// The ``` ``n ``` arity of a generic method reference
    #[must_use]
    pub fn generic_arity(&self) -> Option<u32> {
        self.arity
    }

    /// The parameter list; `None` when the reference has none, which matches any overload
    #[must_use]
    pub fn parameters(&self) -> Option<&[TypeName]> {
        self.parameters.as_deref()
    }

    /// The `~` return type of conversion operators
    #[must_use]
    pub fn return_type(&self) -> Option<&TypeName> {
        self.return_type.as_ref()
    }
}

impl fmt::Display for CodeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.path.join("."))?;
        if let Some(member) = &self.member {
            write!(f, ".{member}")?;
        }
        if let Some(arity) = self.arity {
            write!(f, "``{arity}")?;
        }
        if let Some(parameters) = &self.parameters {
            f.write_str("(")?;
            write_list(f, parameters)?;
            f.write_str(")")?;
        }
        if let Some(return_type) = &self.return_type {
            write!(f, "~{return_type}")?;
        }
        Ok(())
    }
}

impl FromStr for CodeReference {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        if text.trim().is_empty() {
            return Err(Error::InvalidArgument("empty code reference".to_string()));
        }
        CodeReference::parse(text)
            .ok_or_else(|| Error::InvalidArgument(format!("malformed code reference '{text}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn kinds() {
        let prefixes: Vec<String> = ReferenceKind::iter().map(|kind| kind.to_string()).collect();
        assert_eq!(prefixes, ["N", "T", "M", "P", "F", "E"]);
        assert!(ReferenceKind::Event.is_member());
        assert!(!ReferenceKind::Type.is_member());
    }

    #[test]
    fn parse_members() {
        let ctor = CodeReference::parse("M:N.Outer`1.Inner.#ctor(`0,System.Int32[])").unwrap();
        assert_eq!(ctor.kind(), ReferenceKind::Method);
        assert_eq!(ctor.type_path(), "N.Outer`1.Inner");
        assert_eq!(ctor.member_name(), Some("#ctor"));
        assert_eq!(ctor.generic_arity(), None);
        assert_eq!(ctor.parameters().unwrap().len(), 2);

        let conversion = CodeReference::parse("M:N.C.op_Implicit(N.C)~System.Int32").unwrap();
        assert_eq!(conversion.return_type().unwrap().to_string(), "System.Int32");

        let indexer = CodeReference::parse("P:N.C.Item(System.Int32)").unwrap();
        assert_eq!(indexer.parameters().unwrap()[0].to_string(), "System.Int32");

        let field = CodeReference::parse("F:N.C.Limit").unwrap();
        assert!(field.parameters().is_none());

        let explicit = CodeReference::parse("M:N.C.N#IFoo#Bar").unwrap();
        assert_eq!(explicit.member_name(), Some("N#IFoo#Bar"));

        let empty = CodeReference::parse("M:N.C.Run()").unwrap();
        assert_eq!(empty.parameters(), Some(&[][..]));
    }

    #[test]
    fn display_is_canonical() {
        for text in [
            "T:N.Outer`1.Inner",
            "M:N.C.Select``2(N.List{``0},System.Int32[0:,0:],System.Int32*@)",
            "M:N.C.op_Explicit(N.C)~System.Int64",
            "P:N.C.Item(`0)",
            "E:N.C.Changed",
            "N:System.Collections",
        ] {
            assert_eq!(CodeReference::parse(text).unwrap().to_string(), text);
        }
        assert_eq!(
            CodeReference::parse(" M:N.C.M(System.Int32[,]) ")
                .unwrap()
                .to_string(),
            "M:N.C.M(System.Int32[0:,0:])"
        );
    }

    #[test]
    fn validity() {
        for valid in ["N:System", "T:C", "M:N.C.M``1(``0)", "P:N.C.P", "F:C.f", "E:C.e"] {
            assert!(CodeReference::is_valid(valid), "{valid}");
        }
        for invalid in [
            "",
            "T",
            "X:N.C",
            "T:",
            "T:N..C",
            "M:C",
            "F:N.C.F(System.Int32)",
            "P:N.C.P``1",
            "T:N.C(System.Int32)",
            "M:N.C.M(System.Int32",
            "M:N.C.M(System.Int32)x",
            "M:N.C``1.M",
            "T:N.C D",
        ] {
            assert!(!CodeReference::is_valid(invalid), "{invalid:?}");
        }

        assert!(CodeReference::is_namespace("N:System.Collections.Generic"));
        assert!(!CodeReference::is_namespace("T:System.String"));
        assert!(!CodeReference::is_namespace("N:"));
    }

    #[test]
    fn from_str() {
        assert!(matches!(
            "".parse::<CodeReference>(),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            "Q:x".parse::<CodeReference>(),
            Err(Error::InvalidArgument(_))
        ));
        let parsed: CodeReference = "T:System.String".parse().unwrap();
        assert_eq!(parsed.kind(), ReferenceKind::Type);
    }
}
