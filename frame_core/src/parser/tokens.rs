//! Line tokenizer for the story-organized text format.
//!
//! A record line is a sequence of whitespace-separated tokens. Double-quoted
//! tokens may contain whitespace and keep their exact text.

use std::fmt;

use winnow::{
    Parser as _,
    ascii::{float, multispace0, space0},
    combinator::{alt, cut_err, preceded, repeat, terminated},
    error::{ContextError, ModalResult, StrContext, StrContextValue},
    token::{rest, take_till, take_while},
};

/// One token of a record line
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// `"..."` with the quotes removed
    Quoted(String),
    /// Anything else
    Bare(String),
}

impl Token {
    /// Token text, regardless of quoting
    pub fn text(&self) -> &str {
        match self {
            Token::Quoted(s) | Token::Bare(s) => s,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Quoted(s) => write!(f, "\"{s}\""),
            Token::Bare(s) => write!(f, "{s}"),
        }
    }
}

/// `"..."`; an opening quote commits to finding the closing one
fn quoted(input: &mut &str) -> ModalResult<Token> {
    preceded(
        '"',
        cut_err(terminated(take_till(0.., '"'), '"'))
            .context(StrContext::Expected(StrContextValue::CharLiteral('"'))),
    )
    .map(|s: &str| Token::Quoted(s.to_string()))
    .parse_next(input)
}

/// A run of anything but whitespace and quotes
fn bare(input: &mut &str) -> ModalResult<Token> {
    take_while(1.., |c: char| !c.is_whitespace() && c != '"')
        .map(|s: &str| Token::Bare(s.to_string()))
        .parse_next(input)
}

fn token(input: &mut &str) -> ModalResult<Token> {
    preceded(multispace0, alt((quoted, bare))).parse_next(input)
}

fn tokens(input: &mut &str) -> ModalResult<Vec<Token>> {
    terminated(repeat(0.., token), multispace0).parse_next(input)
}

/// Split a line into tokens. Fails on an unterminated quote.
pub fn tokenize(line: &str) -> Result<Vec<Token>, String> {
    tokens
        .parse(line)
        .map_err(|e| format!("unterminated quote, {} at column {}", e.inner(), e.offset() + 1))
}

fn section_header<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    preceded(('$', space0), rest).map(str::trim).parse_next(input)
}

/// Title of a `$ ...` section header line, trimmed; `None` for record lines
pub fn section_title(line: &str) -> Option<&str> {
    section_header.parse(line).ok()
}

/// Sequential reader over the tokens of one record.
///
/// Errors are plain reason strings; the record parser attaches the section
/// and line number.
#[derive(Debug)]
pub struct Cursor {
    tokens: Vec<Token>,
    pos: usize,
}

impl Cursor {
    pub fn new(tokens: Vec<Token>) -> Self {
        Cursor { tokens, pos: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    pub fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    pub fn next_token(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Next token as text, quoted or bare
    pub fn text(&mut self, what: &str) -> Result<String, String> {
        self.next_token()
            .map(|t| t.text().to_string())
            .ok_or_else(|| format!("missing {what}"))
    }

    /// Next token as a number
    pub fn number(&mut self, what: &str) -> Result<f64, String> {
        let token = self.next_token().ok_or_else(|| format!("missing {what}"))?;
        parse_number(token.text()).ok_or_else(|| format!("{what} is not a number: {token}"))
    }

    /// Next token as a number when one is present, leaving keywords untouched
    pub fn optional_number(&mut self) -> Option<f64> {
        let value = self.peek().and_then(|t| match t {
            Token::Bare(s) => parse_number(s),
            Token::Quoted(_) => None,
        })?;
        self.pos += 1;
        Some(value)
    }

    /// Next bare word, upper-cased
    pub fn keyword(&mut self) -> Option<String> {
        match self.peek() {
            Some(Token::Bare(s)) => {
                let keyword = s.to_ascii_uppercase();
                self.pos += 1;
                Some(keyword)
            }
            _ => None,
        }
    }
}

/// Parse a finite float, accepting a leading `+`. The whole text must be the number.
pub fn parse_number(text: &str) -> Option<f64> {
    float::<&str, f64, ContextError>
        .parse(text)
        .ok()
        .filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_mixed() {
        let tokens = tokenize(r#"STORY "Level 2"  HEIGHT 3.5 SIMILARTO "L1""#).unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Bare("STORY".into()),
                Token::Quoted("Level 2".into()),
                Token::Bare("HEIGHT".into()),
                Token::Bare("3.5".into()),
                Token::Bare("SIMILARTO".into()),
                Token::Quoted("L1".into()),
            ]
        );
    }

    #[test]
    fn test_empty_quotes() {
        let tokens = tokenize(r#"POINT "" 1 2"#).unwrap();
        assert_eq!(tokens[1], Token::Quoted(String::new()));
    }

    #[test]
    fn test_unterminated_quote() {
        let err = tokenize(r#"POINT "12 3.0 4.0"#).unwrap_err();
        assert!(err.contains("unterminated"));
    }

    #[test]
    fn test_cursor_numbers() {
        let mut cursor = Cursor::new(tokenize(r#""7" 1.5 -2e3 DIAPH "D1""#).unwrap());
        assert_eq!(cursor.text("id").unwrap(), "7");
        assert_eq!(cursor.number("x").unwrap(), 1.5);
        assert_eq!(cursor.optional_number(), Some(-2000.0));
        assert_eq!(cursor.optional_number(), None);
        assert_eq!(cursor.keyword().as_deref(), Some("DIAPH"));
        assert_eq!(cursor.text("value").unwrap(), "D1");
        assert!(cursor.is_empty());
        assert!(cursor.number("y").unwrap_err().contains("missing y"));
    }

    #[test]
    fn test_whitespace_only_line() {
        assert!(tokenize("   \t ").unwrap().is_empty());
    }

    #[test]
    fn test_adjacent_quotes_split() {
        let tokens = tokenize(r#"RESTRAINT"UX UY""#).unwrap();
        assert_eq!(tokens, vec![Token::Bare("RESTRAINT".into()), Token::Quoted("UX UY".into())]);
    }

    #[test]
    fn test_section_title() {
        assert_eq!(section_title("$ POINT COORDINATES  "), Some("POINT COORDINATES"));
        assert_eq!(section_title("$STORIES - IN SEQUENCE FROM TOP"), Some("STORIES - IN SEQUENCE FROM TOP"));
        assert_eq!(section_title(r#"STORY "L1""#), None);
    }

    #[test]
    fn test_trailing_garbage_is_not_a_number() {
        assert_eq!(parse_number("3.5m"), None);
        assert_eq!(parse_number("-0.25"), Some(-0.25));
    }

    #[test]
    fn test_rejects_non_finite() {
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("+4"), Some(4.0));
    }
}
