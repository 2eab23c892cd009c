//! Recursive-descent parser for text search expressions.
//!
//! ```text
//! sexpr   := sfactor ('|' sfactor)*
//! sfactor := sphrase (conj sphrase)*
//! conj    := '&' ['-'] | ('<' | '>' | '~') ['[' INT ']'] | ['-']
//! sphrase := sterm | '"' sterm+ '"'
//! sterm   := WORD | '(' sexpr ')'
//! ```
//!
//! Two phrases side by side with no operator are an implicit `&`.

use tabula_common::{Result, error::Error};

use super::SearchOptions;
use super::expr::{ConjOp, SearchExpr};
use crate::tokenizer::normalize_word;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(String),
    Pipe,
    Amp,
    Minus,
    Lt,
    Gt,
    Tilde,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Quote,
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '\'' || c == '*' || c == '_'
}

fn tokenize(text: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        let token = match c {
            c if c.is_whitespace() => continue,
            '|' => Token::Pipe,
            '&' => Token::Amp,
            '-' => Token::Minus,
            '<' => Token::Lt,
            '>' => Token::Gt,
            '~' => Token::Tilde,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '"' => Token::Quote,
            c if is_word_char(c) => {
                let mut end = start + c.len_utf8();
                while let Some(&(pos, next)) = chars.peek() {
                    if !is_word_char(next) {
                        break;
                    }
                    end = pos + next.len_utf8();
                    chars.next();
                }
                Token::Word(text[start..end].to_string())
            }
            other => {
                return Err(Error::expression(format!(
                    "unexpected character '{other}' at offset {start} in search \"{text}\""
                )));
            }
        };
        tokens.push(token);
    }
    Ok(tokens)
}

struct Parser<'a> {
    text: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    nearness: u32,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn error(&self, what: &str) -> Error {
        match self.peek() {
            Some(token) => Error::expression(format!(
                "{what}, found {token:?} in search \"{}\"",
                self.text
            )),
            None => Error::expression(format!("{what} at end of search \"{}\"", self.text)),
        }
    }

    fn expect(&mut self, token: &Token, what: &str) -> Result<()> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(what))
        }
    }

    fn sexpr(&mut self) -> Result<SearchExpr> {
        let mut parts = vec![self.sfactor()?];
        while self.eat(&Token::Pipe) {
            parts.push(self.sfactor()?);
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            SearchExpr::Disjunction(parts)
        })
    }

    fn sfactor(&mut self) -> Result<SearchExpr> {
        let mut lhs = self.sphrase()?;
        loop {
            let (op, nearness) = match self.peek() {
                Some(Token::Amp) => {
                    self.pos += 1;
                    if self.eat(&Token::Minus) {
                        (ConjOp::AndNot, self.nearness)
                    } else {
                        (ConjOp::And, self.nearness)
                    }
                }
                Some(Token::Lt) | Some(Token::Gt) | Some(Token::Tilde) => {
                    let op = match self.next() {
                        Some(Token::Lt) => ConjOp::Before,
                        Some(Token::Gt) => ConjOp::After,
                        _ => ConjOp::Near,
                    };
                    (op, self.window()?)
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    (ConjOp::AndNot, self.nearness)
                }
                Some(Token::Word(_)) | Some(Token::LParen) | Some(Token::Quote) => {
                    (ConjOp::And, self.nearness)
                }
                _ => break,
            };
            let rhs = self.sphrase()?;
            lhs = SearchExpr::conjunction(op, lhs, rhs, nearness);
        }
        Ok(lhs)
    }

    /// Optional `[n]` after a proximity operator.
    fn window(&mut self) -> Result<u32> {
        if !self.eat(&Token::LBracket) {
            return Ok(self.nearness);
        }
        let n = match self.next() {
            Some(Token::Word(w)) => w
                .parse::<u32>()
                .map_err(|_| Error::expression(format!("bad nearness '{w}' in search \"{}\"", self.text)))?,
            _ => return Err(Error::expression(format!("nearness expected in search \"{}\"", self.text))),
        };
        self.expect(&Token::RBracket, "']' expected")?;
        Ok(n)
    }

    fn sphrase(&mut self) -> Result<SearchExpr> {
        if !self.eat(&Token::Quote) {
            return self.sterm();
        }
        let mut terms = Vec::new();
        while !self.eat(&Token::Quote) {
            if self.peek().is_none() {
                return Err(self.error("closing '\"' expected"));
            }
            terms.push(self.sterm()?);
        }
        match terms.len() {
            0 => Err(Error::expression(format!("empty phrase in search \"{}\"", self.text))),
            1 => Ok(terms.remove(0)),
            _ => Ok(SearchExpr::Phrase(terms)),
        }
    }

    fn sterm(&mut self) -> Result<SearchExpr> {
        match self.peek() {
            Some(Token::Word(_)) => match self.next() {
                Some(Token::Word(w)) => Ok(SearchExpr::Word(normalize_word(&w))),
                _ => Err(self.error("word expected")),
            },
            Some(Token::LParen) => {
                self.pos += 1;
                let expr = self.sexpr()?;
                self.expect(&Token::RParen, "')' expected")?;
                Ok(expr)
            }
            _ => Err(self.error("word expected")),
        }
    }
}

/// Parses a search expression such as `quick & (fox | dog)` or
/// `"brown fox" ~[3] lazy`.
pub fn parse_search(text: &str, options: &SearchOptions) -> Result<SearchExpr> {
    let tokens = tokenize(text)?;
    if tokens.is_empty() {
        return Err(Error::expression("empty search expression"));
    }
    let mut parser = Parser {
        text,
        tokens,
        pos: 0,
        nearness: options.nearness,
    };
    let expr = parser.sexpr()?;
    if parser.peek().is_some() {
        return Err(parser.error("end of search expected"));
    }
    Ok(expr)
}
