//! Lexer (tokenizer) for the block-diagram DSL.

use std::fmt;

use crate::error::{EngineError, Result};

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The kind of token
    pub kind: TokenKind,
    /// The token's text
    pub text: String,
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
}

/// Token types in the DSL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// A non-negative decimal literal (`12`, `0.5`, `3.`)
    Number,
    /// An identifier
    Name,

    // Keywords
    Def,
    If,
    Else,
    For,
    While,
    And,
    Or,
    Not,
    Return,

    // Arithmetic and wiring
    Plus,
    Minus,
    Star,
    Slash,
    /// The pipe operator `@`
    At,

    // Relational
    EqEq,
    NotEq,
    GreaterEq,
    LessEq,
    Greater,
    Less,

    /// Assignment `=`
    Assign,
    Comma,
    Dot,
    OpenParen,
    CloseParen,
    OpenBracket,
    CloseBracket,
    OpenBrace,
    CloseBrace,

    /// Statement separators
    Newline,
    Semicolon,

    /// End of file
    Eof,
}

impl TokenKind {
    /// Resolve a keyword, if `word` is one.
    fn keyword(word: &str) -> Option<Self> {
        match word {
            "def" => Some(Self::Def),
            "if" => Some(Self::If),
            "else" => Some(Self::Else),
            "for" => Some(Self::For),
            "while" => Some(Self::While),
            "and" => Some(Self::And),
            "or" => Some(Self::Or),
            "not" => Some(Self::Not),
            "return" => Some(Self::Return),
            _ => None,
        }
    }

    /// Whether this token separates statements.
    pub fn is_separator(self) -> bool {
        matches!(self, Self::Newline | Self::Semicolon)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Number => "a number",
            Self::Name => "a name",
            Self::Def => "'def'",
            Self::If => "'if'",
            Self::Else => "'else'",
            Self::For => "'for'",
            Self::While => "'while'",
            Self::And => "'and'",
            Self::Or => "'or'",
            Self::Not => "'not'",
            Self::Return => "'return'",
            Self::Plus => "'+'",
            Self::Minus => "'-'",
            Self::Star => "'*'",
            Self::Slash => "'/'",
            Self::At => "'@'",
            Self::EqEq => "'=='",
            Self::NotEq => "'!='",
            Self::GreaterEq => "'>='",
            Self::LessEq => "'<='",
            Self::Greater => "'>'",
            Self::Less => "'<'",
            Self::Assign => "'='",
            Self::Comma => "','",
            Self::Dot => "'.'",
            Self::OpenParen => "'('",
            Self::CloseParen => "')'",
            Self::OpenBracket => "'['",
            Self::CloseBracket => "']'",
            Self::OpenBrace => "'{'",
            Self::CloseBrace => "'}'",
            Self::Newline => "a newline",
            Self::Semicolon => "';'",
            Self::Eof => "end of input",
        };
        f.write_str(text)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Number | TokenKind::Name => write!(f, "{} '{}'", self.kind, self.text),
            _ => write!(f, "{}", self.kind),
        }
    }
}

/// Lexer for tokenizing DSL input.
///
/// Tokens are produced on demand, so a program whose tail contains an
/// unknown character still runs every statement before it.
pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input.
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    /// Get the next token.
    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace();

        let start_line = self.line;
        let start_column = self.column;
        let token = |kind: TokenKind, text: String| Token {
            kind,
            text,
            line: start_line,
            column: start_column,
        };

        let Some(&ch) = self.chars.peek() else {
            return Ok(token(TokenKind::Eof, String::new()));
        };

        // Two-character operators must win over their one-character prefixes.
        if let Some(kind) = self.two_char_operator(ch) {
            let mut text = String::new();
            text.extend(self.advance());
            text.extend(self.advance());
            return Ok(token(kind, text));
        }

        let single = match ch {
            '\n' => Some(TokenKind::Newline),
            ';' => Some(TokenKind::Semicolon),
            '+' => Some(TokenKind::Plus),
            '-' => Some(TokenKind::Minus),
            '*' => Some(TokenKind::Star),
            '/' => Some(TokenKind::Slash),
            '@' => Some(TokenKind::At),
            '>' => Some(TokenKind::Greater),
            '<' => Some(TokenKind::Less),
            '=' => Some(TokenKind::Assign),
            ',' => Some(TokenKind::Comma),
            '.' => Some(TokenKind::Dot),
            '(' => Some(TokenKind::OpenParen),
            ')' => Some(TokenKind::CloseParen),
            '[' => Some(TokenKind::OpenBracket),
            ']' => Some(TokenKind::CloseBracket),
            '{' => Some(TokenKind::OpenBrace),
            '}' => Some(TokenKind::CloseBrace),
            _ => None,
        };
        if let Some(kind) = single {
            self.advance();
            return Ok(token(kind, ch.to_string()));
        }

        if ch.is_ascii_digit() {
            return Ok(token(TokenKind::Number, self.read_number()));
        }

        if ch.is_ascii_alphabetic() || ch == '_' {
            let text = self.read_identifier();
            let kind = TokenKind::keyword(&text).unwrap_or(TokenKind::Name);
            return Ok(token(kind, text));
        }

        Err(EngineError::lexer(
            start_line,
            start_column,
            format!("unexpected character '{}'", ch.escape_default()),
        ))
    }

    fn two_char_operator(&self, first: char) -> Option<TokenKind> {
        let mut ahead = self.chars.clone();
        ahead.next();
        if ahead.next() != Some('=') {
            return None;
        }
        match first {
            '=' => Some(TokenKind::EqEq),
            '!' => Some(TokenKind::NotEq),
            '>' => Some(TokenKind::GreaterEq),
            '<' => Some(TokenKind::LessEq),
            _ => None,
        }
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(&ch) = self.chars.peek() {
            if matches!(ch, ' ' | '\t' | '\r' | '\x0b' | '\x0c') {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut text = String::new();
        while let Some(&ch) = self.chars.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        text
    }

    fn read_number(&mut self) -> String {
        let mut text = String::new();

        // Integer part
        while let Some(&ch) = self.chars.peek() {
            if ch.is_ascii_digit() {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        // Decimal part, digits after the point are optional
        if let Some(&'.') = self.chars.peek() {
            text.push('.');
            self.advance();
            while let Some(&ch) = self.chars.peek() {
                if ch.is_ascii_digit() {
                    text.push(ch);
                    self.advance();
                } else {
                    break;
                }
            }
        }

        text
    }
}

/// Tokenize a whole input, stopping after the first error.
pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_lexer_basic() {
        let tokens = tokenize("x = 2.5 * y").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Name);
        assert_eq!(tokens[0].text, "x");
        assert_eq!(tokens[1].kind, TokenKind::Assign);
        assert_eq!(tokens[2].kind, TokenKind::Number);
        assert_eq!(tokens[2].text, "2.5");
        assert_eq!(tokens[3].kind, TokenKind::Star);
        assert_eq!(tokens[4].text, "y");
        assert_eq!(tokens[5].kind, TokenKind::Eof);
    }

    #[test]
    fn test_relational_operators_before_prefixes() {
        assert_eq!(
            kinds("a == b >= c <= d != e = f > g < h"),
            vec![
                TokenKind::Name,
                TokenKind::EqEq,
                TokenKind::Name,
                TokenKind::GreaterEq,
                TokenKind::Name,
                TokenKind::LessEq,
                TokenKind::Name,
                TokenKind::NotEq,
                TokenKind::Name,
                TokenKind::Assign,
                TokenKind::Name,
                TokenKind::Greater,
                TokenKind::Name,
                TokenKind::Less,
                TokenKind::Name,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_eq!(
            kinds("def define if iffy while return returned"),
            vec![
                TokenKind::Def,
                TokenKind::Name,
                TokenKind::If,
                TokenKind::Name,
                TokenKind::While,
                TokenKind::Return,
                TokenKind::Name,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_separators_are_kept() {
        assert_eq!(
            kinds("a\n\tb ; c"),
            vec![
                TokenKind::Name,
                TokenKind::Newline,
                TokenKind::Name,
                TokenKind::Semicolon,
                TokenKind::Name,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_number_forms() {
        let tokens = tokenize("12 0.001 3.").unwrap();
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["12", "0.001", "3.", ""]);
    }

    #[test]
    fn test_unknown_character() {
        let err = tokenize("x = 1\ny = $").unwrap_err();
        match err {
            EngineError::LexerError { line, column, message } => {
                assert_eq!(line, 2);
                assert_eq!(column, 5);
                assert!(message.contains('$'));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_lexing_is_lazy() {
        let mut lexer = Lexer::new("a ?");
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Name);
        assert!(lexer.next_token().is_err());
    }
}
