//! MSH Parser
//!
//! Splits an input line into [`Token`]s and groups them into the segments
//! that run one after another.

use std::fmt;

pub use self::segment::{run_segments, Segment};

mod segment;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TokenKind {
    Word,
    Pipe,
    Sequence,
    And,
    Or,
    Background,
    RedirectIn,
    RedirectOut,
}

impl TokenKind {
    /// Returns the kind of the operator spelled by `c`, if any.
    fn single_char_operator(c: char) -> Option<TokenKind> {
        match c {
            '|' => Some(TokenKind::Pipe),
            ';' => Some(TokenKind::Sequence),
            '&' => Some(TokenKind::Background),
            '<' => Some(TokenKind::RedirectIn),
            '>' => Some(TokenKind::RedirectOut),
            _ => None,
        }
    }

    /// `;`, `&&` and `||` separate segments.
    pub fn is_segment_boundary(self) -> bool {
        match self {
            TokenKind::Sequence | TokenKind::And | TokenKind::Or => true,
            _ => false,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Token {
    pub text: String,
    pub kind: TokenKind,
}

impl Token {
    pub fn word<T: Into<String>>(text: T) -> Self {
        Self {
            text: text.into(),
            kind: TokenKind::Word,
        }
    }

    pub fn operator(kind: TokenKind) -> Self {
        let text = match kind {
            TokenKind::Word => "",
            TokenKind::Pipe => "|",
            TokenKind::Sequence => ";",
            TokenKind::And => "&&",
            TokenKind::Or => "||",
            TokenKind::Background => "&",
            TokenKind::RedirectIn => "<",
            TokenKind::RedirectOut => ">",
        };
        Self {
            text: text.to_string(),
            kind,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// Splits `line` into words and operators.
///
/// Operators terminate a word even without surrounding whitespace, and
/// `&&`/`||` win over `&`/`|`. At most `max_tokens` tokens are produced; the
/// rest of the line is silently dropped.
pub fn tokenize(line: &str, max_tokens: usize) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = line.char_indices().peekable();

    while tokens.len() < max_tokens {
        let (start, c) = match chars.next() {
            Some(next) => next,
            None => break,
        };
        if c.is_whitespace() {
            continue;
        }

        let next = chars.peek().map(|&(_, n)| n);
        let operator = match (c, next) {
            ('&', Some('&')) => Some(TokenKind::And),
            ('|', Some('|')) => Some(TokenKind::Or),
            _ => TokenKind::single_char_operator(c),
        };
        if let Some(kind) = operator {
            if kind == TokenKind::And || kind == TokenKind::Or {
                chars.next();
            }
            tokens.push(Token::operator(kind));
            continue;
        }

        let mut end = start + c.len_utf8();
        while let Some(&(i, n)) = chars.peek() {
            if n.is_whitespace() || TokenKind::single_char_operator(n).is_some() {
                break;
            }
            end = i + n.len_utf8();
            chars.next();
        }
        tokens.push(Token::word(&line[start..end]));
    }

    tokens
}
