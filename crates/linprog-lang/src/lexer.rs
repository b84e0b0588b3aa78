use std::str::Chars;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Keywords
    Max,
    Min,

    // Literals
    Ident,
    Number,

    // Operators
    Plus,
    Minus,
    Star,
    Eq,
    Le,
    Ge,

    // Special
    Newline,
    Comment,
    Eof,
    Error,
}

impl TokenKind {
    pub fn is_relational(self) -> bool {
        matches!(self, TokenKind::Eq | TokenKind::Le | TokenKind::Ge)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub text: String,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span, text: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            text: text.into(),
        }
    }
}

pub struct Lexer<'a> {
    source: &'a str,
    chars: Chars<'a>,
    pos: usize,
    current: Option<char>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut chars = source.chars();
        let current = chars.next();
        Self {
            source,
            chars,
            pos: 0,
            current,
        }
    }

    pub fn tokenize(source: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.current;
        self.current = self.chars.next();
        if let Some(c) = c {
            self.pos += c.len_utf8();
        }
        c
    }

    fn peek(&self) -> Option<char> {
        self.current
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.clone().next()
    }

    /// Consume characters while `pred` holds
    fn eat_while(&mut self, pred: impl Fn(char) -> bool) {
        while self.peek().is_some_and(&pred) {
            self.advance();
        }
    }

    fn token_from(&self, kind: TokenKind, start: usize) -> Token {
        Token::new(kind, Span::new(start, self.pos), &self.source[start..self.pos])
    }

    fn line_comment(&mut self) -> Token {
        let start = self.pos;
        self.eat_while(|c| c != '\n');
        self.token_from(TokenKind::Comment, start)
    }

    fn block_comment(&mut self) -> Token {
        let start = self.pos;
        self.advance();
        self.advance();
        // an unterminated comment runs to the end of input
        while let Some(c) = self.advance() {
            if c == '*' && self.peek() == Some('/') {
                self.advance();
                break;
            }
        }
        self.token_from(TokenKind::Comment, start)
    }

    /// Unsigned decimal: `12`, `0.5`, `.25`
    fn number(&mut self) -> Token {
        let start = self.pos;
        self.eat_while(|c| c.is_ascii_digit());
        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            self.eat_while(|c| c.is_ascii_digit());
        }
        self.token_from(TokenKind::Number, start)
    }

    fn word(&mut self) -> Token {
        let start = self.pos;
        self.eat_while(|c| c.is_alphanumeric() || c == '_');
        let kind = match &self.source[start..self.pos] {
            "max" | "maximize" => TokenKind::Max,
            "min" | "minimize" => TokenKind::Min,
            _ => TokenKind::Ident,
        };
        self.token_from(kind, start)
    }

    /// Single-character token, or a two-character one if `second` follows
    fn read_operator(&mut self, single: TokenKind, second: char, double: TokenKind) -> Token {
        let start = self.pos;
        self.advance();
        if self.peek() == Some(second) {
            self.advance();
            return self.token_from(double, start);
        }
        self.token_from(single, start)
    }

    pub fn next_token(&mut self) -> Token {
        self.eat_while(|c| matches!(c, ' ' | '\t' | '\r'));

        let start = self.pos;

        let Some(c) = self.peek() else {
            return Token::new(TokenKind::Eof, Span::new(start, start), "");
        };

        match c {
            '\n' => {
                self.advance();
                self.token_from(TokenKind::Newline, start)
            }
            '/' => match self.peek_next() {
                Some('/') => self.line_comment(),
                Some('*') => self.block_comment(),
                _ => {
                    self.advance();
                    self.token_from(TokenKind::Error, start)
                }
            },
            '+' => {
                self.advance();
                self.token_from(TokenKind::Plus, start)
            }
            '-' => {
                self.advance();
                self.token_from(TokenKind::Minus, start)
            }
            '*' => {
                self.advance();
                self.token_from(TokenKind::Star, start)
            }
            '=' => {
                // `==` is accepted as a plain equality
                self.read_operator(TokenKind::Eq, '=', TokenKind::Eq)
            }
            '<' => self.read_operator(TokenKind::Error, '=', TokenKind::Le),
            '>' => self.read_operator(TokenKind::Error, '=', TokenKind::Ge),
            '≤' => {
                self.advance();
                self.token_from(TokenKind::Le, start)
            }
            '≥' => {
                self.advance();
                self.token_from(TokenKind::Ge, start)
            }
            '.' if self.peek_next().is_some_and(|c| c.is_ascii_digit()) => self.number(),
            c if c.is_ascii_digit() => self.number(),
            c if c.is_alphabetic() || c == '_' => self.word(),
            _ => {
                self.advance();
                self.token_from(TokenKind::Error, start)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::tokenize(source).iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            kinds("max maximize min minimize maxi"),
            vec![
                TokenKind::Max,
                TokenKind::Max,
                TokenKind::Min,
                TokenKind::Min,
                TokenKind::Ident,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        let tokens = Lexer::tokenize("100 8.5 .25 0.005");
        let texts: Vec<_> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["100", "8.5", ".25", "0.005", ""]);
    }

    #[test]
    fn test_coefficient_glued_to_variable() {
        let tokens = Lexer::tokenize("4x1 0.05x4");
        let texts: Vec<_> = tokens.iter().map(|t| (t.kind, t.text.as_str())).collect();
        assert_eq!(
            texts,
            vec![
                (TokenKind::Number, "4"),
                (TokenKind::Ident, "x1"),
                (TokenKind::Number, "0.05"),
                (TokenKind::Ident, "x4"),
                (TokenKind::Eof, ""),
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("+ - * = <= >= ≤ ≥"),
            vec![
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Star,
                TokenKind::Eq,
                TokenKind::Le,
                TokenKind::Ge,
                TokenKind::Le,
                TokenKind::Ge,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_negative_number_is_minus_then_number() {
        assert_eq!(
            kinds("x >= -1"),
            vec![
                TokenKind::Ident,
                TokenKind::Ge,
                TokenKind::Minus,
                TokenKind::Number,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_strict_comparison_is_an_error() {
        assert_eq!(
            kinds("x < 1"),
            vec![TokenKind::Ident, TokenKind::Error, TokenKind::Number, TokenKind::Eof]
        );
    }

    #[test]
    fn test_comments() {
        assert_eq!(
            kinds("x1 // comment\n/* block */ x2"),
            vec![
                TokenKind::Ident,
                TokenKind::Comment,
                TokenKind::Newline,
                TokenKind::Comment,
                TokenKind::Ident,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_spans_are_byte_offsets() {
        let tokens = Lexer::tokenize("x ≤ 10");
        assert_eq!(tokens[1].span, Span::new(2, 5));
        assert_eq!(tokens[2].span, Span::new(6, 8));
    }
}
