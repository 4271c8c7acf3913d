//! Metadata tokens.
//!
//! A token is the 32-bit coordinate of a metadata row: the high byte names the table, the low 24
//! bits the one-based row. Tokens are only meaningful relative to the module that issued them,
//! which is why handles in [`crate::metadata::handle`] always pair them with a module id.

use std::fmt;

use crate::metadata::tables::TableId;

const ROW_MASK: u32 = 0x00FF_FFFF;

/// A row of one of the metadata tables of a module.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Token(u32);

impl Token {
    /// Wraps a raw token value
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Token(value)
    }

    /// The token of the one-based `row` of `table`
    #[must_use]
    pub const fn from_parts(table: TableId, row: u32) -> Self {
        Token(((table as u32) << 24) | (row & ROW_MASK))
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// The raw table number
    #[must_use]
    pub const fn table(self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// The table, if the table number is one ECMA-335 defines
    #[must_use]
    pub fn table_id(self) -> Option<TableId> {
        TableId::from_u8(self.table())
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn is_table(self, table: TableId) -> bool {
        self.table() == table as u8
    }

    /// The one-based row; 0 for a null token
    #[must_use]
    pub const fn row(self) -> u32 {
        self.0 & ROW_MASK
    }

    /// Returns true if this token does not point at any row, as in an absent `Extends` column
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.row() == 0
    }
}

impl From<u32> for Token {
    fn from(value: u32) -> Self {
        Token(value)
    }
}

impl From<Token> for u32 {
    fn from(token: Token) -> Self {
        token.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.table_id() {
            Some(table) => write!(f, "{table:?}#{}", self.row()),
            None => write!(f, "Token(0x{:08x})", self.0),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parts() {
        let token = Token::new(0x0600_0001);
        assert_eq!(token.table(), 0x06);
        assert_eq!(token.table_id(), Some(TableId::MethodDef));
        assert_eq!(token.row(), 1);

        let token = Token::from_parts(TableId::TypeDef, 5);
        assert_eq!(token.value(), 0x0200_0005);
        assert!(token.is_table(TableId::TypeDef));
        assert!(!token.is_table(TableId::TypeRef));

        // rows wider than 24 bits do not leak into the table byte
        assert!(Token::from_parts(TableId::Field, 0x0100_0002).is_table(TableId::Field));
        assert_eq!(Token::new(0x7F00_0001).table_id(), None);
    }

    #[test]
    fn null_tokens() {
        assert!(Token::default().is_null());
        assert!(Token::from_parts(TableId::TypeDef, 0).is_null());
        assert!(!Token::new(0x0600_0001).is_null());
    }

    #[test]
    fn formatting() {
        let token = Token::from_parts(TableId::MemberRef, 12);
        assert_eq!(token.to_string(), "0x0a00000c");
        assert_eq!(format!("{token:?}"), "MemberRef#12");
        assert_eq!(format!("{:?}", Token::new(0x7F00_0001)), "Token(0x7f000001)");
    }
}
