use std::fmt;

use crate::error::{Location, ParseError, Result};
use crate::token_type::TokenKind::{self, *};

/// Controls how the [`Scanner`] classifies characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizerOptions {
    /// Drop whitespace and line-end tokens instead of emitting them.
    pub skip_whitespace: bool,
    /// Characters that always form a single-character `Symbol` token.
    pub symbol_chars: Vec<char>,
    /// Digits continue a word (and a number running into letters becomes a word).
    pub digits_are_word_chars: bool,
    /// Characters that are not letters, digits, whitespace, quotes or symbols continue a word.
    pub unknown_chars_are_word_chars: bool,
}

impl Default for TokenizerOptions {
    fn default() -> Self {
        TokenizerOptions {
            skip_whitespace: false,
            symbol_chars: vec!['(', ')', ','],
            digits_are_word_chars: false,
            unknown_chars_are_word_chars: false,
        }
    }
}

impl TokenizerOptions {
    /// The preset used to read filter expressions: `Order.Status`, `-1` and `geo.distance`
    /// come out as single words.
    pub fn filter_syntax() -> Self {
        TokenizerOptions {
            skip_whitespace: true,
            digits_are_word_chars: true,
            unknown_chars_are_word_chars: true,
            ..TokenizerOptions::default()
        }
    }
}

/// Holds the text and options; every call to [`Tokenizer::tokens`] restarts from the beginning.
#[derive(Debug, Clone)]
pub struct Tokenizer<'a> {
    source: &'a str,
    options: TokenizerOptions,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a str, options: TokenizerOptions) -> Self {
        Tokenizer { source, options }
    }

    pub fn tokens(&self) -> Scanner<'_> {
        Scanner::new(self.source, &self.options)
    }

    /// Collects every token, including the trailing `EOF`.
    pub fn read_all(&self) -> Result<Vec<Token>> {
        self.tokens().collect()
    }
}

/// The `Scanner` walks the source once, yielding tokens lazily. It stops after `EOF` or
/// after the first error.
pub struct Scanner<'a> {
    source: &'a str,
    options: &'a TokenizerOptions,
    chars: std::str::CharIndices<'a>, // iterator over chars of source
    current: Option<(usize, char)>,   // current char (byte index, char)
    next: Option<(usize, char)>,      // next char (byte index, char)
    line: usize,
    column: usize,
    finished: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str, options: &'a TokenizerOptions) -> Self {
        let mut chars = source.char_indices();
        let current = chars.next();
        let next = chars.clone().next();

        Scanner {
            source,
            options,
            chars,
            current,
            next,
            line: 1,
            column: 1,
            finished: false,
        }
    }

    fn scan_token(&mut self) -> Result<Token> {
        let start = self.byte_index();
        let location = Location::new(self.line, self.column);

        let c = match self.advance() {
            Some(ch) => ch,
            None => return Ok(self.make_token(EOF, start, location)),
        };

        let kind = match c {
            '\'' => self.quoted_string(location)?,
            '\r' => {
                self.match_char('\n');
                self.new_line();
                EOL
            }
            '\n' => {
                self.new_line();
                EOL
            }
            _ if c.is_whitespace() => {
                while matches!(self.peek(), Some(c) if c.is_whitespace() && c != '\r' && c != '\n') {
                    self.advance();
                }
                WhiteSpace
            }
            _ if self.options.symbol_chars.contains(&c) => Symbol,
            _ if c.is_ascii_digit() => self.number_or_word(),
            _ if Self::is_alpha(c) => self.word(),
            _ if self.options.unknown_chars_are_word_chars => self.word(),
            _ => Symbol,
        };

        Ok(self.make_token(kind, start, location))
    }

    /// Consumes up to the closing quote. A doubled quote inside the string is a literal quote.
    fn quoted_string(&mut self, location: Location) -> Result<TokenKind> {
        loop {
            match self.advance() {
                Some('\'') => {
                    if !self.match_char('\'') {
                        return Ok(QuotedString);
                    }
                }
                Some('\n') => self.new_line(),
                Some(_) => {}
                None => {
                    return Err(ParseError::Tokenize {
                        message: "unterminated quoted string".to_string(),
                        location,
                    });
                }
            }
        }
    }

    fn word(&mut self) -> TokenKind {
        while matches!(self.peek(), Some(c) if self.continues_word(c)) {
            self.advance();
        }
        Word
    }

    fn number_or_word(&mut self) -> TokenKind {
        // Integer part
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }

        // Fractional part
        if let (Some('.'), Some(c_next)) = (self.peek(), self.peek_next()) {
            if c_next.is_ascii_digit() {
                self.advance(); // consume the '.'
                while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }

        // Digits running into word characters -> word
        if self.options.digits_are_word_chars
            && matches!(self.peek(), Some(c) if self.continues_word(c))
        {
            return self.word();
        }

        Number
    }

    fn continues_word(&self, c: char) -> bool {
        if Self::is_alpha(c) {
            return true;
        }
        if c.is_ascii_digit() {
            return self.options.digits_are_word_chars;
        }
        self.options.unknown_chars_are_word_chars && self.is_unknown(c)
    }

    fn is_unknown(&self, c: char) -> bool {
        !(c.is_alphanumeric()
            || c == '_'
            || c == '\''
            || c.is_whitespace()
            || self.options.symbol_chars.contains(&c))
    }

    fn is_alpha(c: char) -> bool {
        c.is_alphabetic() || c == '_'
    }

    fn new_line(&mut self) {
        self.line += 1;
        self.column = 1;
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            return true;
        }
        false
    }

    /// Return current char and advance to next.
    fn advance(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.current = self.next;
            self.chars.next();
            self.next = self.chars.clone().next();
            self.column += 1;
        }
        c
    }

    /// Return current char without advancing.
    fn peek(&self) -> Option<char> {
        self.current.map(|(_, c)| c)
    }

    /// Return next char without advancing.
    fn peek_next(&self) -> Option<char> {
        self.next.map(|(_, c)| c)
    }

    fn byte_index(&self) -> usize {
        self.current
            .map(|(idx, _)| idx)
            .unwrap_or(self.source.len())
    }

    fn make_token(&self, kind: TokenKind, start: usize, location: Location) -> Token {
        Token {
            kind,
            text: self.source[start..self.byte_index()].to_string(),
            line: location.line,
            column: location.column,
        }
    }
}

impl Iterator for Scanner<'_> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            match self.scan_token() {
                Ok(token) if self.options.skip_whitespace && matches!(token.kind, WhiteSpace | EOL) => {
                    continue;
                }
                Ok(token) => {
                    if token.kind == EOF {
                        self.finished = true;
                    }
                    return Some(Ok(token));
                }
                Err(error) => {
                    self.finished = true;
                    return Some(Err(error));
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize, column: usize) -> Self {
        Token {
            kind,
            text: text.into(),
            line,
            column,
        }
    }

    pub fn location(&self) -> Location {
        Location::new(self.line, self.column)
    }

    pub fn is_symbol(&self, symbol: &str) -> bool {
        self.kind == Symbol && self.text == symbol
    }

    /// `and`/`or` in any letter case.
    pub fn conjunction(&self) -> Option<&'static str> {
        if self.kind != Word {
            return None;
        }
        if self.text.eq_ignore_ascii_case("and") {
            Some("and")
        } else if self.text.eq_ignore_ascii_case("or") {
            Some("or")
        } else {
            None
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(source: &str, options: TokenizerOptions) -> Vec<(TokenKind, String)> {
        Tokenizer::new(source, options)
            .read_all()
            .unwrap()
            .into_iter()
            .map(|t| (t.kind, t.text))
            .collect()
    }

    fn kinds(source: &str) -> Vec<(TokenKind, String)> {
        scan(source, TokenizerOptions::filter_syntax())
    }

    #[test]
    fn test_filter_syntax_tokens() {
        let tokens = kinds("substring(Order.Name,1,3) eq 'Jim'");
        let expected = vec![
            (Word, "substring"),
            (Symbol, "("),
            (Word, "Order.Name"),
            (Symbol, ","),
            (Number, "1"),
            (Symbol, ","),
            (Number, "3"),
            (Symbol, ")"),
            (Word, "eq"),
            (QuotedString, "'Jim'"),
            (EOF, ""),
        ];
        let expected: Vec<_> = expected.into_iter().map(|(k, t)| (k, t.to_string())).collect();
        assert_eq!(tokens, expected);
    }

    #[test]
    fn test_numbers_and_words() {
        let cases = vec![
            ("3", Number),
            ("3.14", Number),
            ("1a", Word),
            ("a1", Word),
            ("-1", Word),
            ("1.2.3", Word),
            ("geo.distance", Word),
        ];
        for (case, kind) in cases {
            let tokens = kinds(case);
            assert_eq!(tokens.len(), 2, "Expected a single token for {:?}: {:?}", case, tokens);
            assert_eq!(tokens[0], (kind, case.to_string()), "Wrong token for {:?}", case);
        }
    }

    #[test]
    fn test_digits_split_without_word_flag() {
        let tokens = scan("a1", TokenizerOptions::default());
        assert_eq!(tokens[0], (Word, "a".to_string()));
        assert_eq!(tokens[1], (Number, "1".to_string()));
    }

    #[test]
    fn test_symbols_adjoining_words() {
        let tokens = kinds("(a,b)");
        let texts: Vec<_> = tokens.iter().map(|(_, t)| t.as_str()).collect();
        assert_eq!(texts, vec!["(", "a", ",", "b", ")", ""]);
    }

    #[test]
    fn test_unknown_chars_are_symbols_by_default() {
        let tokens = scan("a=b", TokenizerOptions::default());
        assert_eq!(
            tokens,
            vec![
                (Word, "a".to_string()),
                (Symbol, "=".to_string()),
                (Word, "b".to_string()),
                (EOF, String::new()),
            ]
        );
    }

    #[test]
    fn test_whitespace_emitted_when_not_skipped() {
        let tokens = scan("a  b\r\nc", TokenizerOptions::default());
        let kinds: Vec<_> = tokens.iter().map(|(k, _)| *k).collect();
        assert_eq!(kinds, vec![Word, WhiteSpace, Word, EOL, Word, EOF]);
        assert_eq!(tokens[1].1, "  ");
        assert_eq!(tokens[3].1, "\r\n");
    }

    #[test]
    fn test_quoted_string_with_escaped_quote() {
        let tokens = kinds("name eq 'O''Brien'");
        assert_eq!(tokens[2], (QuotedString, "'O''Brien'".to_string()));
        let tokens = kinds("''");
        assert_eq!(tokens[0], (QuotedString, "''".to_string()));
    }

    #[test]
    fn test_unterminated_quoted_string() {
        let cases = vec!["'abc", "name eq 'O''", "a eq 'b''c", "'"];
        for case in cases {
            let result = Tokenizer::new(case, TokenizerOptions::filter_syntax()).read_all();
            assert!(
                matches!(result, Err(ParseError::Tokenize { .. })),
                "Expected tokenize error for {:?}, got {:?}",
                case,
                result
            );
        }
    }

    #[test]
    fn test_positions() {
        let tokens = Tokenizer::new("a eq 1\n  and b", TokenizerOptions::filter_syntax())
            .read_all()
            .unwrap();
        let positions: Vec<_> = tokens.iter().map(|t| (t.text.as_str(), t.line, t.column)).collect();
        assert_eq!(
            positions,
            vec![("a", 1, 1), ("eq", 1, 3), ("1", 1, 6), ("and", 2, 3), ("b", 2, 7), ("", 2, 8)]
        );
    }

    #[test]
    fn test_tokenizer_is_restartable() {
        let tokenizer = Tokenizer::new("a eq 1", TokenizerOptions::filter_syntax());
        let first: Vec<_> = tokenizer.tokens().collect();
        let second: Vec<_> = tokenizer.tokens().collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 4);
    }

    #[test]
    fn test_scanner_stops_after_error() {
        let options = TokenizerOptions::filter_syntax();
        let mut scanner = Scanner::new("a 'b", &options);
        assert!(matches!(scanner.next(), Some(Ok(_))));
        assert!(matches!(scanner.next(), Some(Err(_))));
        assert!(scanner.next().is_none());
    }

    #[test]
    fn test_conjunction_is_case_insensitive() {
        let token = Token::new(Word, "AND", 1, 1);
        assert_eq!(token.conjunction(), Some("and"));
        let token = Token::new(QuotedString, "'or'", 1, 1);
        assert_eq!(token.conjunction(), None);
    }
}
