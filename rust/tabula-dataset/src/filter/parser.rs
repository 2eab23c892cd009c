//! Recursive-descent parser for filter expressions.
//!
//! ```text
//! expr       := factor ('or' factor)*
//! factor     := comparison ('and' comparison)*
//! comparison := '(' expr ')' | 'not' comparison | ID op term
//! term       := INT | FLOAT | STR | '(' term (',' term)* ')'
//!             | 'date' '(' y ',' m ',' d ')' | 'date' YYYY-MM-DD
//!             | 'reldate' '(' [ID '=' term (',' ID '=' term)*] ')'
//!             | '[[' search ']]'
//! ```

use std::fmt;

use chrono::NaiveDate;
use tabula_common::{Result, error::Error};
use tabula_store::Value;

use super::lexer::{Spanned, Token, tokenize};
use super::ops::Operator;
use super::reldate;

/// Parsed filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    Or(Vec<FilterExpr>),
    And(Vec<FilterExpr>),
    Not(Box<FilterExpr>),
    Compare {
        column: String,
        op: Operator,
        value: Literal,
    },
}

/// Right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Scalar(Value),
    List(Vec<Value>),
    /// Unparsed text search expression.
    Search(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Scalar(v) => f.write_str(&v.repr()),
            Literal::List(items) => {
                f.write_str("(")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(&v.repr())?;
                }
                f.write_str(")")
            }
            Literal::Search(text) => write!(f, "[[{text}]]"),
        }
    }
}

impl fmt::Display for FilterExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |f: &mut fmt::Formatter<'_>, parts: &[FilterExpr], sep: &str| {
            f.write_str("(")?;
            for (i, part) in parts.iter().enumerate() {
                if i > 0 {
                    write!(f, " {sep} ")?;
                }
                write!(f, "{part}")?;
            }
            f.write_str(")")
        };
        match self {
            FilterExpr::Or(parts) => join(f, parts, "or"),
            FilterExpr::And(parts) => join(f, parts, "and"),
            FilterExpr::Not(inner) => write!(f, "not {inner}"),
            FilterExpr::Compare { column, op, value } => write!(f, "{column} {op} {value}"),
        }
    }
}

/// Parses `text`, resolving `reldate` literals against the local date.
pub fn parse_filter(text: &str) -> Result<FilterExpr> {
    parse_filter_at(text, chrono::Local::now().date_naive())
}

/// Parses `text`, resolving `reldate` literals against `today`.
pub fn parse_filter_at(text: &str, today: NaiveDate) -> Result<FilterExpr> {
    let tokens = tokenize(text)?;
    let mut parser = Parser {
        text,
        tokens,
        pos: 0,
        today,
    };
    if parser.tokens.is_empty() {
        return Err(Error::expression("empty filter expression"));
    }
    let expr = parser.expr()?;
    if parser.pos < parser.tokens.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(expr)
}

struct Parser<'a> {
    text: &'a str,
    tokens: Vec<Spanned>,
    pos: usize,
    today: NaiveDate,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.peek_at(0)
    }

    fn peek_at(&self, ahead: usize) -> Option<&Token> {
        self.tokens.get(self.pos + ahead).map(|s| &s.token)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|s| s.token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn peek_word(&self, ahead: usize, word: &str) -> bool {
        self.peek_at(ahead).is_some_and(|t| t.is_word(word))
    }

    /// Steps back over a token returned by `next`.
    fn back(&mut self, token: &Option<Token>) {
        if token.is_some() {
            self.pos -= 1;
        }
    }

    /// Consumes `word` if it is next.
    fn accept_word(&mut self, word: &str) -> bool {
        let found = self.peek_word(0, word);
        if found {
            self.pos += 1;
        }
        found
    }

    fn expect_word(&mut self, word: &str) -> Result<()> {
        if self.accept_word(word) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{word}'")))
        }
    }

    fn expect(&mut self, token: Token, what: &str) -> Result<()> {
        if self.peek() == Some(&token) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected {what}")))
        }
    }

    fn error(&self, message: &str) -> Error {
        match self.tokens.get(self.pos) {
            Some(spanned) => Error::expression(format!(
                "{message} at offset {} in filter \"{}\"",
                spanned.offset, self.text
            )),
            None => Error::expression(format!(
                "{message} at end of filter \"{}\"",
                self.text
            )),
        }
    }

    fn expr(&mut self) -> Result<FilterExpr> {
        let mut parts = vec![self.factor()?];
        while self.accept_word("or") {
            parts.push(self.factor()?);
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            FilterExpr::Or(parts)
        })
    }

    fn factor(&mut self) -> Result<FilterExpr> {
        let mut parts = vec![self.comparison()?];
        while self.accept_word("and") {
            parts.push(self.comparison()?);
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            FilterExpr::And(parts)
        })
    }

    fn comparison(&mut self) -> Result<FilterExpr> {
        match self.peek() {
            Some(Token::LParen) => {
                self.pos += 1;
                let inner = self.expr()?;
                self.expect(Token::RParen, "')'")?;
                Ok(inner)
            }
            Some(t) if t.is_word("not") => {
                self.pos += 1;
                Ok(FilterExpr::Not(Box::new(self.comparison()?)))
            }
            Some(Token::Ident(column)) => {
                let column = column.clone();
                self.pos += 1;
                let op = self.operator()?;
                let value = self.term_for(op)?;
                Ok(FilterExpr::Compare { column, op, value })
            }
            _ => Err(self.error("expected a column name, 'not' or '('")),
        }
    }

    fn operator(&mut self) -> Result<Operator> {
        let op = match self.next() {
            Some(Token::Symbol(symbol)) => match symbol.as_str() {
                "=" | "==" => Operator::Equal,
                "!=" | "!==" | "<>" | "#" => Operator::NotEqual,
                "<" => Operator::Less,
                "<=" | "=<" => Operator::LessEqual,
                ">" => Operator::Greater,
                ">=" | "=>" => Operator::GreaterEqual,
                _ => {
                    self.pos -= 1;
                    return Err(self.error("unknown operator"));
                }
            },
            Some(Token::Ident(word)) => match self.word_operator(&word.to_ascii_lowercase()) {
                Some(op) => op?,
                None => {
                    self.pos -= 1;
                    return Err(self.error(&format!("unknown operator '{word}'")));
                }
            },
            Some(_) => {
                self.pos -= 1;
                return Err(self.error("expected an operator"));
            }
            None => return Err(self.error("expected an operator")),
        };
        if self.peek() == Some(&Token::Colon) {
            self.pos += 1;
            return op
                .prefix()
                .ok_or_else(|| self.error(&format!("'{op}' has no prefix form")));
        }
        Ok(op)
    }

    /// Word operators, with `word` already consumed. `None` when `word` does
    /// not start an operator.
    fn word_operator(&mut self, word: &str) -> Option<Result<Operator>> {
        let op = match word {
            "eq" | "equals" | "equalto" => Operator::Equal,
            "equal" => {
                self.accept_word("to");
                Operator::Equal
            }
            "ne" | "notequal" | "notequalto" | "doesnotequal" => Operator::NotEqual,
            "does" => return Some(self.does_not_equal()),
            "not" => return Some(self.negated_operator()),
            "lt" | "lessthan" => Operator::Less,
            "le" | "lessequal" | "lessthanorequalto" => Operator::LessEqual,
            "less" => return Some(self.ordering_words(Operator::Less, Operator::LessEqual)),
            "gt" | "greaterthan" => Operator::Greater,
            "ge" | "greaterequal" | "greaterthanorequalto" => Operator::GreaterEqual,
            "greater" => {
                return Some(self.ordering_words(Operator::Greater, Operator::GreaterEqual));
            }
            "startingwith" | "startswith" => Operator::EqualPrefix,
            "starting" | "starts" => {
                return Some(self.expect_word("with").map(|_| Operator::EqualPrefix));
            }
            "notstartingwith" | "notstartswith" => Operator::NotEqualPrefix,
            "in" => Operator::In,
            "notin" => Operator::NotIn,
            "between" => Operator::Between,
            "contains" => Operator::Contains,
            _ => return None,
        };
        Some(Ok(op))
    }

    fn does_not_equal(&mut self) -> Result<Operator> {
        self.expect_word("not")?;
        self.expect_word("equal")?;
        self.accept_word("to");
        Ok(Operator::NotEqual)
    }

    /// After `not`: `not equal [to]`, `not in`, `not starting with`.
    fn negated_operator(&mut self) -> Result<Operator> {
        if self.accept_word("equal") {
            self.accept_word("to");
            return Ok(Operator::NotEqual);
        }
        if self.accept_word("in") {
            return Ok(Operator::NotIn);
        }
        if self.accept_word("startingwith") || self.accept_word("startswith") {
            return Ok(Operator::NotEqualPrefix);
        }
        if self.accept_word("starting") || self.accept_word("starts") {
            self.expect_word("with")?;
            return Ok(Operator::NotEqualPrefix);
        }
        Err(self.error("expected 'equal', 'in' or 'starting with' after 'not'"))
    }

    /// `less than`, `less than or equal [to]`, `less or equal` and the
    /// `greater` forms.
    fn ordering_words(&mut self, strict: Operator, inclusive: Operator) -> Result<Operator> {
        let than = self.accept_word("than");
        if self.peek_word(0, "or") && self.peek_word(1, "equal") {
            self.pos += 2;
            self.accept_word("to");
            return Ok(inclusive);
        }
        if than {
            Ok(strict)
        } else {
            Err(self.error("expected 'than' or 'or equal'"))
        }
    }

    fn term_for(&mut self, op: Operator) -> Result<Literal> {
        let literal = self.term()?;
        let problem = match (&literal, op) {
            (Literal::List(items), Operator::Between) => (items.len() != 2)
                .then(|| "'between' needs a list of two values".to_string()),
            (_, Operator::Between) => Some("'between' needs a list of two values".to_string()),
            (Literal::List(_), op) if op.takes_list() => None,
            (_, op) if op.takes_list() => Some(format!("'{op}' needs a list")),
            (Literal::Search(_) | Literal::Scalar(Value::Str(_)), Operator::Contains) => None,
            (_, Operator::Contains) => Some("'contains' needs search text".to_string()),
            (Literal::Search(_), _) => {
                Some("search text is only valid with 'contains'".to_string())
            }
            (Literal::List(_), op) => Some(format!("'{op}' needs a single value")),
            (Literal::Scalar(_), _) => None,
        };
        if let Some(problem) = problem {
            return Err(self.error(&problem));
        }
        Ok(match literal {
            Literal::Scalar(Value::Str(text)) if op == Operator::Contains => Literal::Search(text),
            other => other,
        })
    }

    fn term(&mut self) -> Result<Literal> {
        match self.next() {
            Some(Token::Search(text)) => Ok(Literal::Search(text)),
            Some(Token::LParen) => {
                let mut items = vec![self.scalar_term()?];
                while self.peek() == Some(&Token::Comma) {
                    self.pos += 1;
                    items.push(self.scalar_term()?);
                }
                self.expect(Token::RParen, "')'")?;
                Ok(Literal::List(items))
            }
            Some(_) => {
                self.pos -= 1;
                self.scalar_term().map(Literal::Scalar)
            }
            None => Err(self.error("expected a value")),
        }
    }

    fn scalar_term(&mut self) -> Result<Value> {
        match self.next() {
            Some(Token::Int(v)) => Ok(Value::Int(v)),
            Some(Token::Float(v)) => Ok(Value::float(v)),
            Some(Token::Str(s)) => Ok(Value::Str(s)),
            Some(t) if t.is_word("date") => self.date_term(),
            Some(t) if t.is_word("reldate") => {
                let kwargs = self.kwargs()?;
                reldate::resolve(&kwargs, self.today).map(Value::Date)
            }
            Some(_) => {
                self.pos -= 1;
                Err(self.error("expected a value"))
            }
            None => Err(self.error("expected a value")),
        }
    }

    fn date_term(&mut self) -> Result<Value> {
        if let Some(Token::Date(date)) = self.peek() {
            let date = *date;
            self.pos += 1;
            return Ok(Value::Date(date));
        }
        self.expect(Token::LParen, "'(' or YYYY-MM-DD after 'date'")?;
        let mut parts = [0i64; 3];
        for (i, part) in parts.iter_mut().enumerate() {
            if i > 0 {
                self.expect(Token::Comma, "','")?;
            }
            match self.next() {
                Some(Token::Int(v)) => *part = v,
                other => {
                    self.back(&other);
                    return Err(self.error("expected an integer date part"));
                }
            }
        }
        self.expect(Token::RParen, "')'")?;
        let [y, m, d] = parts;
        i32::try_from(y)
            .ok()
            .zip(u32::try_from(m).ok())
            .zip(u32::try_from(d).ok())
            .and_then(|((y, m), d)| NaiveDate::from_ymd_opt(y, m, d))
            .map(Value::Date)
            .ok_or_else(|| Error::expression(format!("invalid date({y}, {m}, {d})")))
    }

    fn kwargs(&mut self) -> Result<Vec<(String, Value)>> {
        self.expect(Token::LParen, "'('")?;
        let mut kwargs = Vec::new();
        if self.peek() == Some(&Token::RParen) {
            self.pos += 1;
            return Ok(kwargs);
        }
        loop {
            let key = match self.next() {
                Some(Token::Ident(key)) => key,
                other => {
                    self.back(&other);
                    return Err(self.error("expected a keyword"));
                }
            };
            match self.next() {
                Some(Token::Symbol(s)) if s == "=" => {}
                other => {
                    self.back(&other);
                    return Err(self.error("expected '='"));
                }
            }
            // bare words such as `align=monday` are taken as strings
            let value = match self.peek() {
                Some(Token::Ident(word))
                    if !word.eq_ignore_ascii_case("date")
                        && !word.eq_ignore_ascii_case("reldate") =>
                {
                    let value = Value::str(word.as_str());
                    self.pos += 1;
                    value
                }
                _ => self.scalar_term()?,
            };
            kwargs.push((key, value));
            match self.next() {
                Some(Token::Comma) => continue,
                Some(Token::RParen) => return Ok(kwargs),
                other => {
                    self.back(&other);
                    return Err(self.error("expected ',' or ')'"));
                }
            }
        }
    }
}
