#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum TokenKind {
    Word,
    Number,
    QuotedString,
    Symbol,
    WhiteSpace,
    EOL,
    EOF,
}

impl TokenKind {
    /// Whitespace, line ends and the end marker carry no meaning for the compiler.
    pub fn is_trivia(&self) -> bool {
        matches!(self, TokenKind::WhiteSpace | TokenKind::EOL | TokenKind::EOF)
    }
}
