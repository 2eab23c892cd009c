//! Tokens of the filter expression language.

use chrono::NaiveDate;
use tabula_common::{Result, error::Error};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Column names, keywords and word operators.
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    /// `YYYY-MM-DD`, only meaningful after `date`.
    Date(NaiveDate),
    /// Symbolic operator such as `=`, `!=`, `<=`, `<>` or `#`.
    Symbol(String),
    /// The raw text between `[[` and `]]`.
    Search(String),
    Colon,
    Comma,
    LParen,
    RParen,
}

impl Token {
    /// Whether the token is the (case-insensitive) word `word`.
    pub fn is_word(&self, word: &str) -> bool {
        matches!(self, Token::Ident(id) if id.eq_ignore_ascii_case(word))
    }
}

/// A token and the byte offset it starts at.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub offset: usize,
}

const SYMBOL_CHARS: &[char] = &['=', '!', '<', '>', '#'];
const SYMBOLS: &[&str] = &["!==", "==", "!=", "<>", "<=", "=<", ">=", "=>", "=", "<", ">", "#"];

pub fn tokenize(text: &str) -> Result<Vec<Spanned>> {
    let mut lexer = Lexer {
        text,
        bytes: text.as_bytes(),
        pos: 0,
    };
    let mut tokens = Vec::new();
    while let Some(spanned) = lexer.next_token()? {
        tokens.push(spanned);
    }
    Ok(tokens)
}

struct Lexer<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl Lexer<'_> {
    fn peek_byte(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn error(&self, message: &str) -> Error {
        Error::expression(format!(
            "{message} at offset {} in filter \"{}\"",
            self.pos, self.text
        ))
    }

    fn next_token(&mut self) -> Result<Option<Spanned>> {
        while self.peek_byte(0).is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
        let Some(b) = self.peek_byte(0) else {
            return Ok(None);
        };
        let offset = self.pos;
        let token = match b {
            b'(' => {
                self.pos += 1;
                Token::LParen
            }
            b')' => {
                self.pos += 1;
                Token::RParen
            }
            b',' => {
                self.pos += 1;
                Token::Comma
            }
            b':' => {
                self.pos += 1;
                Token::Colon
            }
            b'[' if self.peek_byte(1) == Some(b'[') => self.search_text()?,
            b'\'' | b'"' => self.string(false)?,
            b'r' | b'R' if matches!(self.peek_byte(1), Some(b'\'' | b'"')) => {
                self.pos += 1;
                self.string(true)?
            }
            b'-' | b'+' if self.peek_byte(1).is_some_and(|c| c.is_ascii_digit() || c == b'.') => {
                self.number()?
            }
            b'.' if self.peek_byte(1).is_some_and(|c| c.is_ascii_digit()) => self.number()?,
            c if c.is_ascii_alphanumeric() || c == b'_' => self.word()?,
            c if SYMBOL_CHARS.contains(&(c as char)) => self.symbol()?,
            _ => return Err(self.error("unexpected character")),
        };
        Ok(Some(Spanned { token, offset }))
    }

    fn search_text(&mut self) -> Result<Token> {
        let start = self.pos + 2;
        match self.text[start..].find("]]") {
            Some(len) => {
                self.pos = start + len + 2;
                Ok(Token::Search(self.text[start..start + len].trim().to_string()))
            }
            None => Err(self.error("unterminated '[['")),
        }
    }

    fn string(&mut self, raw: bool) -> Result<Token> {
        let quote = self.bytes[self.pos];
        self.pos += 1;
        let mut out = String::new();
        let mut chars = self.text[self.pos..].char_indices();
        while let Some((i, c)) = chars.next() {
            if c as u32 == quote as u32 {
                self.pos += i + 1;
                return Ok(Token::Str(out));
            }
            if c == '\\' && !raw {
                let Some((_, escaped)) = chars.next() else {
                    break;
                };
                out.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    '0' => '\0',
                    other => other,
                });
                continue;
            }
            out.push(c);
        }
        Err(self.error("unterminated string"))
    }

    fn digits(&mut self) -> usize {
        let start = self.pos;
        while self.peek_byte(0).is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        self.pos - start
    }

    fn number(&mut self) -> Result<Token> {
        let start = self.pos;
        if matches!(self.peek_byte(0), Some(b'-' | b'+')) {
            self.pos += 1;
        }
        let int_digits = self.digits();
        if int_digits == 4 && self.peek_byte(0) == Some(b'-') && start == self.pos - 4 {
            if let Some(date) = self.try_date(start) {
                return Ok(date);
            }
        }
        let mut is_float = false;
        if self.peek_byte(0) == Some(b'.') {
            is_float = true;
            self.pos += 1;
            self.digits();
        }
        if matches!(self.peek_byte(0), Some(b'e' | b'E')) {
            let save = self.pos;
            self.pos += 1;
            if matches!(self.peek_byte(0), Some(b'-' | b'+')) {
                self.pos += 1;
            }
            if self.digits() > 0 {
                is_float = true;
            } else {
                self.pos = save;
            }
        }
        if self
            .peek_byte(0)
            .is_some_and(|b| b.is_ascii_alphabetic() || b == b'_')
        {
            // digits running into letters form a word such as `1st`
            if !is_float && int_digits > 0 && self.bytes[start].is_ascii_digit() {
                self.pos = start;
                return self.word();
            }
            return Err(self.error("malformed number"));
        }
        let text = &self.text[start..self.pos];
        if is_float {
            text.parse::<f64>()
                .map(Token::Float)
                .map_err(|_| self.error("malformed number"))
        } else {
            text.parse::<i64>()
                .map(Token::Int)
                .map_err(|_| self.error("integer out of range"))
        }
    }

    /// `YYYY-M-D` starting at `start`, with the year already consumed.
    fn try_date(&mut self, start: usize) -> Option<Token> {
        let save = self.pos;
        self.pos += 1;
        let month_digits = self.digits();
        if !(1..=2).contains(&month_digits) || self.peek_byte(0) != Some(b'-') {
            self.pos = save;
            return None;
        }
        self.pos += 1;
        let day_digits = self.digits();
        if !(1..=2).contains(&day_digits) {
            self.pos = save;
            return None;
        }
        let mut parts = self.text[start..self.pos].split('-');
        let parse = |p: Option<&str>| p.and_then(|s| s.parse::<u32>().ok());
        let year = parse(parts.next())? as i32;
        let month = parse(parts.next())?;
        let day = parse(parts.next())?;
        match NaiveDate::from_ymd_opt(year, month, day) {
            Some(date) => Some(Token::Date(date)),
            None => {
                self.pos = save;
                None
            }
        }
    }

    fn word(&mut self) -> Result<Token> {
        let start = self.pos;
        while self
            .peek_byte(0)
            .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_')
        {
            self.pos += 1;
        }
        let word = &self.text[start..self.pos];
        if word.bytes().all(|b| b.is_ascii_digit()) {
            self.pos = start;
            return self.number();
        }
        Ok(Token::Ident(word.to_string()))
    }

    fn symbol(&mut self) -> Result<Token> {
        let rest = &self.text[self.pos..];
        match SYMBOLS.iter().find(|s| rest.starts_with(**s)) {
            Some(symbol) => {
                self.pos += symbol.len();
                Ok(Token::Symbol(symbol.to_string()))
            }
            None => Err(self.error("unknown operator")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(text: &str) -> Vec<Token> {
        tokenize(text).unwrap().into_iter().map(|s| s.token).collect()
    }

    #[test]
    fn test_comparison() {
        assert_eq!(
            tokens("age >= 30"),
            vec![Token::Ident("age".into()), Token::Symbol(">=".into()), Token::Int(30)]
        );
        assert_eq!(
            tokens("a=-1.5e2"),
            vec![Token::Ident("a".into()), Token::Symbol("=".into()), Token::Float(-150.0)]
        );
    }

    #[test]
    fn test_strings() {
        assert_eq!(tokens(r#"'it\'s'"#), vec![Token::Str("it's".into())]);
        assert_eq!(tokens(r#""a\tb""#), vec![Token::Str("a\tb".into())]);
        assert_eq!(tokens(r"r'a\b'"), vec![Token::Str(r"a\b".into())]);
        assert!(tokenize("'open").is_err());
    }

    #[test]
    fn test_prefix_and_search() {
        assert_eq!(
            tokens("name =: 'ad' or notes contains [[quick & fox]]"),
            vec![
                Token::Ident("name".into()),
                Token::Symbol("=".into()),
                Token::Colon,
                Token::Str("ad".into()),
                Token::Ident("or".into()),
                Token::Ident("notes".into()),
                Token::Ident("contains".into()),
                Token::Search("quick & fox".into()),
            ]
        );
    }

    #[test]
    fn test_dates_and_words() {
        let d = NaiveDate::from_ymd_opt(2004, 3, 1).unwrap();
        assert_eq!(tokens("date 2004-3-01"), vec![Token::Ident("date".into()), Token::Date(d)]);
        assert_eq!(
            tokens("align=1st"),
            vec![Token::Ident("align".into()), Token::Symbol("=".into()), Token::Ident("1st".into())]
        );
        assert_eq!(tokens("12"), vec![Token::Int(12)]);
    }
}
