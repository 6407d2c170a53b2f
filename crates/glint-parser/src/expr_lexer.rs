//! Lexer for glint expressions.
//!
//! Tokenizes the expression language used in `name:` attributes and in
//! `{{ ... }}` interpolations. Operates on a single expression string.
//!
//! # Examples
//!
//! ```
//! use glint_parser::expr_lexer::{ExprLexer, TokenKind};
//!
//! let tokens = ExprLexer::tokenize("count + 1").unwrap();
//! assert_eq!(tokens[0].kind, TokenKind::Symbol("count".into()));
//! assert_eq!(tokens[1].kind, TokenKind::Plus);
//! assert_eq!(tokens[2].kind, TokenKind::Num(1.0));
//! ```

use crate::SyntaxError;

/// A character range in expression text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExprSpan {
    pub start: usize,
    pub end: usize,
}

impl ExprSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// A token produced by the expression lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: ExprSpan,
}

/// Token classification. Only `Num`, `Symbol` and `Str` carry a value.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Delimiters
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,

    // Chains
    Dot,
    OptionalDot,

    // Operators
    Plus,
    Minus,
    Slash,
    Star,
    Pipe,
    Not,
    EqEq,
    NotEq,
    Or,
    And,
    In,
    NotIn,

    // Literals
    True,
    False,
    Num(f64),
    Symbol(String),
    Str(String),
}

impl TokenKind {
    /// Source-like rendering for error messages.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::LParen => "(".into(),
            TokenKind::RParen => ")".into(),
            TokenKind::LBracket => "[".into(),
            TokenKind::RBracket => "]".into(),
            TokenKind::Comma => ",".into(),
            TokenKind::Dot => ".".into(),
            TokenKind::OptionalDot => ".?".into(),
            TokenKind::Plus => "+".into(),
            TokenKind::Minus => "-".into(),
            TokenKind::Slash => "/".into(),
            TokenKind::Star => "*".into(),
            TokenKind::Pipe => "|".into(),
            TokenKind::Not => "!".into(),
            TokenKind::EqEq => "==".into(),
            TokenKind::NotEq => "!=".into(),
            TokenKind::Or => "||".into(),
            TokenKind::And => "&&".into(),
            TokenKind::In => "in".into(),
            TokenKind::NotIn => "not in".into(),
            TokenKind::True => "true".into(),
            TokenKind::False => "false".into(),
            TokenKind::Num(n) => n.to_string(),
            TokenKind::Symbol(s) => s.clone(),
            TokenKind::Str(s) => format!("{s:?}"),
        }
    }
}

/// glint expression lexer.
pub struct ExprLexer {
    chars: Vec<char>,
    pos: usize,
}

impl ExprLexer {
    /// Create a new expression lexer for the given source.
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    /// Tokenize the entire source into a vector of tokens.
    pub fn tokenize(source: &str) -> Result<Vec<Token>, SyntaxError> {
        let mut lexer = ExprLexer::new(source);
        let mut tokens: Vec<Token> = Vec::new();

        while let Some(token) = lexer.next_token()? {
            // `not in` / `! in` fold into one operator
            if token.kind == TokenKind::In
                && tokens.last().is_some_and(|t| t.kind == TokenKind::Not)
            {
                let start = tokens.pop().map_or(token.span.start, |t| t.span.start);
                tokens.push(Token {
                    kind: TokenKind::NotIn,
                    span: ExprSpan::new(start, token.span.end),
                });
            } else {
                tokens.push(token);
            }
        }

        Ok(tokens)
    }

    /// Read the next token from the source, `None` at the end.
    pub fn next_token(&mut self) -> Result<Option<Token>, SyntaxError> {
        self.skip_whitespace();

        if self.is_at_end() {
            return Ok(None);
        }

        let start = self.pos;
        let ch = self.current();

        // Two-character operators are checked first: their leading chars overlap single ones.
        let two = match (ch, self.peek()) {
            ('=', Some('=')) => Some(TokenKind::EqEq),
            ('!', Some('=')) => Some(TokenKind::NotEq),
            ('|', Some('|')) => Some(TokenKind::Or),
            ('&', Some('&')) => Some(TokenKind::And),
            ('.', Some('?')) => Some(TokenKind::OptionalDot),
            _ => None,
        };
        if let Some(kind) = two {
            self.advance_n(2);
            return Ok(Some(self.token(kind, start)));
        }

        let single = match ch {
            '(' => Some(TokenKind::LParen),
            ')' => Some(TokenKind::RParen),
            '[' => Some(TokenKind::LBracket),
            ']' => Some(TokenKind::RBracket),
            ',' => Some(TokenKind::Comma),
            '.' => Some(TokenKind::Dot),
            '+' => Some(TokenKind::Plus),
            '-' => Some(TokenKind::Minus),
            '/' => Some(TokenKind::Slash),
            '*' => Some(TokenKind::Star),
            '|' => Some(TokenKind::Pipe),
            '!' => Some(TokenKind::Not),
            _ => None,
        };
        if let Some(kind) = single {
            self.advance();
            return Ok(Some(self.token(kind, start)));
        }

        match ch {
            '0'..='9' => self.read_number(start).map(Some),
            '\'' | '"' => self.read_string(start).map(Some),
            'a'..='z' | 'A'..='Z' => Ok(Some(self.read_identifier(start))),
            _ => Err(SyntaxError {
                message: format!(
                    "Unable to tokenize expression at char {} '{ch}'",
                    start + 1
                ),
                position: start,
            }),
        }
    }

    // --- Private helpers ---

    /// Digits with an optional single `.`; `_` separators are ignored.
    /// A `.` not followed by a digit ends the number.
    fn read_number(&mut self, start: usize) -> Result<Token, SyntaxError> {
        let mut text = String::new();
        let mut seen_dot = false;

        while !self.is_at_end() {
            let c = self.current();
            let next_is_digit = self.peek().is_some_and(|n| n.is_ascii_digit());
            if c.is_ascii_digit() {
                text.push(c);
            } else if c == '_' {
                // digit group separator
            } else if c == '.' && next_is_digit {
                if seen_dot {
                    return Err(SyntaxError {
                        message: "numbers may not contain more than one dot".into(),
                        position: self.pos,
                    });
                }
                seen_dot = true;
                text.push(c);
            } else {
                break;
            }
            self.advance();
        }

        let value: f64 = text.parse().map_err(|_| SyntaxError {
            message: format!("Invalid number: '{text}'"),
            position: start,
        })?;

        Ok(self.token(TokenKind::Num(value), start))
    }

    fn read_string(&mut self, start: usize) -> Result<Token, SyntaxError> {
        let quote = self.current();
        self.advance(); // skip opening quote

        let mut value = String::new();

        while !self.is_at_end() && self.current() != quote {
            if self.current() == '\\' {
                self.advance();
                if self.is_at_end() {
                    break;
                }
                // only the quote and the backslash itself are escapes
                match self.current() {
                    '\\' => value.push('\\'),
                    c if c == quote => value.push(c),
                    c => {
                        value.push('\\');
                        value.push(c);
                    }
                }
            } else {
                value.push(self.current());
            }
            self.advance();
        }

        if self.is_at_end() {
            return Err(SyntaxError {
                message: format!(
                    "string {value:?} started at position {}, but not closed by end of expression",
                    start + 1
                ),
                position: start,
            });
        }

        self.advance(); // skip closing quote

        Ok(self.token(TokenKind::Str(value), start))
    }

    /// Identifier runs are `[a-zA-Z][a-zA-Z_]*`; exact keyword matches become keyword tokens.
    fn read_identifier(&mut self, start: usize) -> Token {
        let mut text = String::new();
        while !self.is_at_end() && (self.current().is_ascii_alphabetic() || self.current() == '_') {
            text.push(self.current());
            self.advance();
        }

        let kind = match text.as_str() {
            "in" => TokenKind::In,
            "or" => TokenKind::Or,
            "and" => TokenKind::And,
            "not" => TokenKind::Not,
            "true" | "True" => TokenKind::True,
            "false" | "False" => TokenKind::False,
            _ => TokenKind::Symbol(text),
        };
        self.token(kind, start)
    }

    fn token(&self, kind: TokenKind, start: usize) -> Token {
        Token {
            kind,
            span: ExprSpan::new(start, self.pos),
        }
    }

    fn current(&self) -> char {
        self.chars[self.pos]
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn advance_n(&mut self, n: usize) {
        self.pos += n;
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn skip_whitespace(&mut self) {
        while !self.is_at_end() && self.current().is_whitespace() {
            self.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(source: &str) -> Vec<TokenKind> {
        ExprLexer::tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn sym(s: &str) -> TokenKind {
        TokenKind::Symbol(s.into())
    }

    // --- Literals ---

    #[test]
    fn test_strings() {
        assert_eq!(kinds("\"foobar\""), vec![TokenKind::Str("foobar".into())]);
        assert_eq!(kinds("'foobar'"), vec![TokenKind::Str("foobar".into())]);
        assert_eq!(kinds("'foo\"bar'"), vec![TokenKind::Str("foo\"bar".into())]);
    }

    #[test]
    fn test_string_escape() {
        assert_eq!(kinds(r#""a\"b""#), vec![TokenKind::Str("a\"b".into())]);
        assert_eq!(kinds(r"'a\\b'"), vec![TokenKind::Str("a\\b".into())]);
        assert_eq!(kinds(r"'x\ny'"), vec![TokenKind::Str("x\\ny".into())]);
        assert_eq!(kinds(r"'\t'"), vec![TokenKind::Str("\\t".into())]);
    }

    #[test]
    fn test_unterminated_string() {
        let err = ExprLexer::tokenize("'abc").unwrap_err();
        assert!(err.message.contains("not closed"));
        assert_eq!(err.position, 0);
    }

    #[test]
    fn test_escaped_quote_does_not_terminate() {
        assert!(ExprLexer::tokenize(r#""abc\""#).is_err());
    }

    #[test]
    fn test_numbers() {
        assert_eq!(kinds("42"), vec![TokenKind::Num(42.0)]);
        assert_eq!(kinds("2.75"), vec![TokenKind::Num(2.75)]);
        assert_eq!(kinds("1_000_000"), vec![TokenKind::Num(1_000_000.0)]);
    }

    #[test]
    fn test_number_dot_not_followed_by_digit() {
        assert_eq!(kinds("1.x"), vec![TokenKind::Num(1.0), TokenKind::Dot, sym("x")]);
    }

    #[test]
    fn test_number_with_two_dots() {
        let err = ExprLexer::tokenize("1.2.3").unwrap_err();
        assert!(err.message.contains("more than one dot"));
    }

    #[test]
    fn test_booleans() {
        assert_eq!(kinds("true"), vec![TokenKind::True]);
        assert_eq!(kinds("True"), vec![TokenKind::True]);
        assert_eq!(kinds("false False"), vec![TokenKind::False, TokenKind::False]);
    }

    // --- Symbols and keywords ---

    #[test]
    fn test_symbols() {
        assert_eq!(kinds("bang"), vec![sym("bang")]);
        assert_eq!(kinds("ba_ng"), vec![sym("ba_ng")]);
    }

    #[test]
    fn test_keyword_must_match_whole_run() {
        assert_eq!(kinds("index"), vec![sym("index")]);
        assert_eq!(kinds("android"), vec![sym("android")]);
        assert_eq!(kinds("notable"), vec![sym("notable")]);
    }

    #[test]
    fn test_keywords() {
        assert_eq!(kinds("in"), vec![TokenKind::In]);
        assert_eq!(kinds("and"), vec![TokenKind::And]);
        assert_eq!(kinds("or"), vec![TokenKind::Or]);
        assert_eq!(kinds("not"), vec![TokenKind::Not]);
    }

    #[test]
    fn test_not_in_folds() {
        assert_eq!(kinds("a not in b"), vec![sym("a"), TokenKind::NotIn, sym("b")]);
        assert_eq!(kinds("a !in b"), vec![sym("a"), TokenKind::NotIn, sym("b")]);
    }

    // --- Operators ---

    #[test]
    fn test_equals() {
        let expected = vec![sym("abc"), TokenKind::EqEq, TokenKind::Num(1.0)];
        assert_eq!(kinds("abc == 1"), expected);
        assert_eq!(kinds("abc==1"), expected);
    }

    #[test]
    fn test_not_equals_group() {
        assert_eq!(
            kinds("abc!= (1, 2, 3)"),
            vec![
                sym("abc"),
                TokenKind::NotEq,
                TokenKind::LParen,
                TokenKind::Num(1.0),
                TokenKind::Comma,
                TokenKind::Num(2.0),
                TokenKind::Comma,
                TokenKind::Num(3.0),
                TokenKind::RParen,
            ]
        );
    }

    #[test]
    fn test_chains() {
        assert_eq!(
            kinds("x.y.?z"),
            vec![sym("x"), TokenKind::Dot, sym("y"), TokenKind::OptionalDot, sym("z")]
        );
        assert_eq!(
            kinds("whatever[1]"),
            vec![
                sym("whatever"),
                TokenKind::LBracket,
                TokenKind::Num(1.0),
                TokenKind::RBracket
            ]
        );
    }

    #[test]
    fn test_pipe_and_or() {
        assert_eq!(kinds("thing|func"), vec![sym("thing"), TokenKind::Pipe, sym("func")]);
        assert_eq!(kinds("a || b"), vec![sym("a"), TokenKind::Or, sym("b")]);
        assert_eq!(kinds("a && b"), vec![sym("a"), TokenKind::And, sym("b")]);
    }

    #[test]
    fn test_bang_is_not() {
        assert_eq!(kinds("!a"), vec![TokenKind::Not, sym("a")]);
    }

    #[test]
    fn test_unexpected_character() {
        let err = ExprLexer::tokenize("a = b").unwrap_err();
        assert!(err.message.contains("'='"));
        assert_eq!(err.position, 2);
        assert!(ExprLexer::tokenize("a & b").is_err());
        assert!(ExprLexer::tokenize("_a").is_err());
    }

    #[test]
    fn test_spans() {
        let tokens = ExprLexer::tokenize("ab == 'c'").unwrap();
        assert_eq!(tokens[0].span, ExprSpan::new(0, 2));
        assert_eq!(tokens[1].span, ExprSpan::new(3, 5));
        assert_eq!(tokens[2].span, ExprSpan::new(6, 9));
    }
}
