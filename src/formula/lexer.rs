use super::expression::Function;
use crate::error::FormulaError;
use std::fmt;

/// A lexical unit of the formula language.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    /// An unquoted ISO date such as `1990-05-01`.
    Date(String),
    /// A single- or double-quoted string.
    Str(String),
    Function(Function),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Comma,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{}", n),
            Token::Date(d) => write!(f, "{}", d),
            Token::Str(s) => write!(f, "'{}'", s),
            Token::Function(func) => write!(f, "{}", func.name()),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
        }
    }
}

/// A token together with its byte offset in the source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub position: usize,
}

/// Splits formula text into tokens.
///
/// Fails on the first character or name outside the formula vocabulary. The
/// caller treats such text as a plain display string rather than an error.
pub fn tokenize(text: &str) -> Result<Vec<Spanned>, FormulaError> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos];
        let start = pos;
        let token = match c {
            b' ' | b'\t' | b'\n' | b'\r' => {
                pos += 1;
                continue;
            }
            b'+' => Token::Plus,
            b'-' => Token::Minus,
            b'*' => Token::Star,
            b'/' => Token::Slash,
            b'(' => Token::LParen,
            b')' => Token::RParen,
            b',' => Token::Comma,
            b'\'' | b'"' => {
                let end = text[start + 1..]
                    .find(c as char)
                    .map(|offset| start + 1 + offset)
                    .ok_or(FormulaError::UnterminatedString(start))?;
                let literal = text[start + 1..end].to_string();
                pos = end + 1;
                tokens.push(Spanned {
                    token: Token::Str(literal),
                    position: start,
                });
                continue;
            }
            b'0'..=b'9' | b'.' => {
                if let Some(len) = date_literal_len(&bytes[start..]) {
                    pos += len;
                    tokens.push(Spanned {
                        token: Token::Date(text[start..pos].to_string()),
                        position: start,
                    });
                    continue;
                }
                pos = scan_number(bytes, start);
                let literal = &text[start..pos];
                let number = literal
                    .parse::<f64>()
                    .map_err(|_| FormulaError::UnexpectedCharacter {
                        found: c as char,
                        position: start,
                    })?;
                tokens.push(Spanned {
                    token: Token::Number(number),
                    position: start,
                });
                continue;
            }
            c if c.is_ascii_alphabetic() => {
                while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_')
                {
                    pos += 1;
                }
                let name = &text[start..pos];
                let function = Function::from_name(name)
                    .ok_or_else(|| FormulaError::UnknownName(name.to_string()))?;
                tokens.push(Spanned {
                    token: Token::Function(function),
                    position: start,
                });
                continue;
            }
            _ => {
                let found = text[start..].chars().next().unwrap_or('\u{FFFD}');
                return Err(FormulaError::UnexpectedCharacter {
                    found,
                    position: start,
                });
            }
        };
        pos += 1;
        tokens.push(Spanned {
            token,
            position: start,
        });
    }

    Ok(tokens)
}

/// True when a token stream reads as a formula rather than display text.
///
/// Commas and quoted strings only belong inside a function call's argument
/// list; anywhere else (`3, 4`, `1,000`, `'hi'`) the text is a literal.
pub fn is_formula(tokens: &[Spanned]) -> bool {
    // One entry per open parenthesis: true when it opened a call.
    let mut frames: Vec<bool> = Vec::new();
    let mut previous: Option<&Token> = None;
    for spanned in tokens {
        match &spanned.token {
            Token::LParen => frames.push(matches!(previous, Some(Token::Function(_)))),
            Token::RParen => {
                frames.pop();
            }
            Token::Comma | Token::Str(_) if frames.last() != Some(&true) => return false,
            _ => {}
        }
        previous = Some(&spanned.token);
    }
    true
}

/// Returns the end of a `digits[.digits]` run starting at `start`.
fn scan_number(bytes: &[u8], start: usize) -> usize {
    let mut pos = start;
    let mut seen_dot = false;
    while pos < bytes.len() {
        match bytes[pos] {
            b'0'..=b'9' => pos += 1,
            b'.' if !seen_dot => {
                seen_dot = true;
                pos += 1;
            }
            _ => break,
        }
    }
    pos
}

/// Length of a `YYYY-MM-DD` literal at the start of `bytes`, if there is one.
fn date_literal_len(bytes: &[u8]) -> Option<usize> {
    const SHAPE: &[u8; 10] = b"dddd-dd-dd";
    if bytes.len() < SHAPE.len() {
        return None;
    }
    let matches = SHAPE.iter().zip(bytes).all(|(expected, actual)| match expected {
        b'd' => actual.is_ascii_digit(),
        other => actual == other,
    });
    let followed_by_digit = bytes
        .get(SHAPE.len())
        .is_some_and(|b| b.is_ascii_digit() || *b == b'.');
    (matches && !followed_by_digit).then_some(SHAPE.len())
}
