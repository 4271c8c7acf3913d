//! Text side of code references: the type-name syntax of parameter lists and the reference
//! head.

use std::fmt;

/// Characters that end an identifier inside a parameter list
const TYPE_DELIMITERS: &[char] = &['.', ',', '(', ')', '{', '}', '[', ']', '~', ':', '*', '@', '`'];

/// Characters that end a segment of a reference head
const HEAD_DELIMITERS: &[char] = &['.', '(', ')', '{', '}', '[', ']', '~', ':', ','];

/// One dot-separated part of a qualified type name, with type arguments if it is instantiated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Segment {
    /// Name; arity suffixes are kept on generic names without arguments
    pub name: String,
    /// Type arguments written in braces
    pub arguments: Vec<TypeName>,
}

impl Segment {
    /// A segment without type arguments
    #[must_use]
    pub fn plain(name: impl Into<String>) -> Self {
        Segment {
            name: name.into(),
            arguments: Vec::new(),
        }
    }
}

/// A type as written in the parameter list of a code reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeName {
    /// A qualified, possibly instantiated, type name (`N.List{System.Int32}`)
    Named(Vec<Segment>),
    /// `` `n ``, a parameter of the declaring type
    TypeParameter(u32),
    /// ``` ``n ```, a parameter of the method
    MethodParameter(u32),
    /// An array; rank 0 covers vectors and single-dimensional arrays alike
    Array(Box<TypeName>, u32),
    /// `*`
    Pointer(Box<TypeName>),
    /// `@`
    ByRef(Box<TypeName>),
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeName::Named(segments) => {
                for (index, segment) in segments.iter().enumerate() {
                    if index > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(&segment.name)?;
                    if !segment.arguments.is_empty() {
                        f.write_str("{")?;
                        write_list(f, &segment.arguments)?;
                        f.write_str("}")?;
                    }
                }
                Ok(())
            }
            TypeName::TypeParameter(number) => write!(f, "`{number}"),
            TypeName::MethodParameter(number) => write!(f, "``{number}"),
            TypeName::Array(element, rank) if *rank <= 1 => write!(f, "{element}[]"),
            TypeName::Array(element, rank) => {
                let dimensions = vec!["0:"; *rank as usize];
                write!(f, "{element}[{}]", dimensions.join(","))
            }
            TypeName::Pointer(element) => write!(f, "{element}*"),
            TypeName::ByRef(element) => write!(f, "{element}@"),
        }
    }
}

/// Writes `types` separated by commas
pub(crate) fn write_list(f: &mut impl fmt::Write, types: &[TypeName]) -> fmt::Result {
    for (index, ty) in types.iter().enumerate() {
        if index > 0 {
            f.write_str(",")?;
        }
        write!(f, "{ty}")?;
    }
    Ok(())
}

/// A cursor over the characters of a reference.
///
/// Every parse method returns `None` on malformed input and leaves the cursor wherever the
/// failure was noticed; callers give up on the whole reference.
pub(crate) struct ReferenceParser<'a> {
    text: &'a str,
    position: usize,
}

impl<'a> ReferenceParser<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        ReferenceParser { text, position: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.position..]
    }

    pub(crate) fn is_done(&self) -> bool {
        self.position >= self.text.len()
    }

    pub(crate) fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    pub(crate) fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.position += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn take_while(&mut self, accept: impl Fn(char) -> bool) -> &'a str {
        let rest = self.rest();
        let length = rest.find(|c: char| !accept(c)).unwrap_or(rest.len());
        self.position += length;
        &rest[..length]
    }

    fn number(&mut self) -> Option<u32> {
        self.take_while(|c| c.is_ascii_digit()).parse().ok()
    }

    /// Dot-separated head segments, up to the parameter list or the end
    pub(crate) fn head(&mut self) -> Option<Vec<&'a str>> {
        let mut segments = Vec::new();
        loop {
            let segment =
                self.take_while(|c| !c.is_whitespace() && !HEAD_DELIMITERS.contains(&c));
            if !valid_segment(segment) {
                return None;
            }
            segments.push(segment);
            if !self.eat('.') {
                return Some(segments);
            }
        }
    }

    /// A parenthesized parameter list; `()` is an explicitly empty list
    pub(crate) fn parameters(&mut self) -> Option<Vec<TypeName>> {
        if !self.eat('(') {
            return None;
        }
        if self.eat(')') {
            return Some(Vec::new());
        }
        let parameters = self.type_list()?;
        self.eat(')').then_some(parameters)
    }

    fn type_list(&mut self) -> Option<Vec<TypeName>> {
        let mut types = vec![self.type_name()?];
        while self.eat(',') {
            types.push(self.type_name()?);
        }
        Some(types)
    }

    pub(crate) fn type_name(&mut self) -> Option<TypeName> {
        let mut ty = if self.eat('`') {
            if self.eat('`') {
                TypeName::MethodParameter(self.number()?)
            } else {
                TypeName::TypeParameter(self.number()?)
            }
        } else {
            TypeName::Named(self.segments()?)
        };
        loop {
            ty = match self.peek() {
                Some('[') => {
                    let rank = self.rank()?;
                    TypeName::Array(Box::new(ty), rank)
                }
                Some('*') => {
                    self.eat('*');
                    TypeName::Pointer(Box::new(ty))
                }
                Some('@') => {
                    self.eat('@');
                    TypeName::ByRef(Box::new(ty))
                }
                _ => return Some(ty),
            };
        }
    }

    fn segments(&mut self) -> Option<Vec<Segment>> {
        let mut segments = Vec::new();
        loop {
            let start = self.position;
            self.take_while(|c| !c.is_whitespace() && !TYPE_DELIMITERS.contains(&c));
            // an arity suffix on an uninstantiated generic name
            if self.rest().starts_with('`')
                && self.rest()[1..].starts_with(|c: char| c.is_ascii_digit())
            {
                self.eat('`');
                self.number()?;
            }
            let name = &self.text[start..self.position];
            if name.is_empty() {
                return None;
            }
            let arguments = if self.eat('{') {
                let arguments = self.type_list()?;
                if !self.eat('}') {
                    return None;
                }
                arguments
            } else {
                Vec::new()
            };
            segments.push(Segment {
                name: name.to_string(),
                arguments,
            });
            if !self.eat('.') {
                return Some(segments);
            }
        }
    }

    /// `[]`, `[,]` or `[0:,0:]`; rank 1 folds into 0
    fn rank(&mut self) -> Option<u32> {
        self.eat('[');
        let bounds = self.take_while(|c| c.is_ascii_digit() || c == ':' || c == ',' || c == '-');
        if !self.eat(']') {
            return None;
        }
        let rank = u32::try_from(bounds.matches(',').count()).ok()? + 1;
        Some(if rank == 1 { 0 } else { rank })
    }
}

/// Returns true for a non-empty head segment whose backticks only introduce arities
fn valid_segment(segment: &str) -> bool {
    let Some(name_end) = segment.find('`') else {
        return !segment.is_empty();
    };
    let arity = segment[name_end..].trim_start_matches('`');
    name_end > 0
        && segment[name_end..].len() - arity.len() <= 2
        && !arity.is_empty()
        && arity.chars().all(|c| c.is_ascii_digit())
}

/// Splits the method arity off a member segment (```Select``2``` → `("Select", Some(2))`)
pub(crate) fn split_arity(segment: &str) -> Option<(&str, Option<u32>)> {
    match segment.split_once("``") {
        Some((name, arity)) => Some((name, Some(arity.parse().ok()?))),
        None => Some((segment, None)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Option<TypeName> {
        let mut parser = ReferenceParser::new(text);
        let ty = parser.type_name()?;
        parser.is_done().then_some(ty)
    }

    #[test]
    fn type_names() {
        let list = parse("System.Collections.Generic.List{System.Int32}").unwrap();
        let TypeName::Named(segments) = &list else {
            panic!("expected a named type, got {list:?}");
        };
        assert_eq!(segments.len(), 4);
        assert_eq!(segments[3].name, "List");
        assert_eq!(
            segments[3].arguments,
            [TypeName::Named(vec![Segment::plain("System"), Segment::plain("Int32")])]
        );

        assert_eq!(parse("`1"), Some(TypeName::TypeParameter(1)));
        assert_eq!(parse("``0"), Some(TypeName::MethodParameter(0)));
        assert_eq!(parse("N.Outer`1").unwrap().to_string(), "N.Outer`1");
        assert_eq!(
            parse("N.Outer{`0}.Inner{``1}[]@").unwrap().to_string(),
            "N.Outer{`0}.Inner{``1}[]@"
        );
        assert_eq!(parse("System.Int32**").unwrap().to_string(), "System.Int32**");
    }

    #[test]
    fn array_ranks() {
        assert_eq!(parse("System.Int32[,]"), parse("System.Int32[0:,0:]"));
        assert_eq!(parse("System.Int32[,,]").unwrap().to_string(), "System.Int32[0:,0:,0:]");
        assert_eq!(parse("System.Int32[0:]"), parse("System.Int32[]"));
        assert!(parse("System.Int32[").is_none());
        assert!(parse("System.Int32[x]").is_none());
    }

    #[test]
    fn malformed() {
        assert!(parse("").is_none());
        assert!(parse("`").is_none());
        assert!(parse("N.List{System.Int32").is_none());
        assert!(parse("N..C").is_none());
        assert!(parse("N.C{}").is_none());
    }

    #[test]
    fn heads() {
        let mut parser = ReferenceParser::new("N.Outer`1.Inner.Select``2(");
        assert_eq!(
            parser.head().unwrap(),
            ["N", "Outer`1", "Inner", "Select``2"]
        );
        assert_eq!(parser.peek(), Some('('));

        assert!(ReferenceParser::new("N..C").head().is_none());
        assert!(ReferenceParser::new("N.C`x").head().is_none());
        assert!(ReferenceParser::new("N.C```1").head().is_none());
        assert_eq!(
            ReferenceParser::new("N.C.N#IFoo#Bar").head().unwrap(),
            ["N", "C", "N#IFoo#Bar"]
        );

        assert_eq!(split_arity("Select``2"), Some(("Select", Some(2))));
        assert_eq!(split_arity("#ctor"), Some(("#ctor", None)));
        assert_eq!(split_arity("Select``"), None);
    }
}
