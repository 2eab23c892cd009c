use std::fmt;

use tabula_common::Result;

use super::hits::SearchHits;
use crate::postings::OccurrenceSource;
use crate::tokenizer::normalize_word;

/// Default distance, in words, for the near/before/after operators.
pub const DEFAULT_NEARNESS: u32 = 10;

/// How the two sides of a [`SearchExpr::Conjunction`] combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConjOp {
    /// `a & b`, or `a b`: both words in the row.
    And,
    /// `a &- b`, or `a -b`: `a` in the row, `b` not.
    AndNot,
    /// `a < b`: `a` at most `nearness` words before `b`.
    Before,
    /// `a > b`: `a` at most `nearness` words after `b`.
    After,
    /// `a ~ b`: either order within `nearness` words.
    Near,
}

impl ConjOp {
    fn symbol(&self) -> &'static str {
        match self {
            ConjOp::And => "&",
            ConjOp::AndNot => "&!",
            ConjOp::Before => "<",
            ConjOp::After => ">",
            ConjOp::Near => "~",
        }
    }
}

/// A parsed text search expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchExpr {
    /// A single normalized word; `*` matches any run of characters.
    Word(String),
    /// Any of the parts (`a | b | c`).
    Disjunction(Vec<SearchExpr>),
    Conjunction {
        op: ConjOp,
        lhs: Box<SearchExpr>,
        rhs: Box<SearchExpr>,
        nearness: u32,
    },
    /// Consecutive words (`"quick brown fox"`).
    Phrase(Vec<SearchExpr>),
}

impl SearchExpr {
    /// Builds a word term, normalizing it the way indexed words are.
    pub fn word(word: &str) -> SearchExpr {
        SearchExpr::Word(normalize_word(word))
    }

    pub fn conjunction(op: ConjOp, lhs: SearchExpr, rhs: SearchExpr, nearness: u32) -> SearchExpr {
        SearchExpr::Conjunction {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            nearness,
        }
    }

    /// Evaluates the expression against a postings source.
    pub fn evaluate<S: OccurrenceSource + ?Sized>(&self, source: &S) -> Result<SearchHits> {
        match self {
            SearchExpr::Word(word) if word.contains('*') => {
                let mut hits = SearchHits::new();
                for candidate in source.words() {
                    if glob_match(word, &candidate) {
                        hits = hits.union(SearchHits::from_occurrences(
                            source.occurrences(&candidate)?,
                        ));
                    }
                }
                Ok(hits)
            }
            SearchExpr::Word(word) => Ok(SearchHits::from_occurrences(source.occurrences(word)?)),
            SearchExpr::Disjunction(parts) => {
                let mut hits = SearchHits::new();
                for part in parts {
                    hits = hits.union(part.evaluate(source)?);
                }
                Ok(hits)
            }
            SearchExpr::Conjunction {
                op,
                lhs,
                rhs,
                nearness,
            } => {
                let left = lhs.evaluate(source)?;
                let right = rhs.evaluate(source)?;
                let n = *nearness;
                Ok(match op {
                    ConjOp::And => left.intersect(&right),
                    ConjOp::AndNot => left.difference(&right),
                    ConjOp::Before => left.pairwise(&right, |l, r| before(l, r, n)),
                    ConjOp::After => left.pairwise(&right, |l, r| after(l, r, n)),
                    ConjOp::Near => {
                        left.pairwise(&right, |l, r| before(l, r, n) || after(l, r, n))
                    }
                })
            }
            SearchExpr::Phrase(words) => {
                let mut iter = words.iter();
                let Some(first) = iter.next() else {
                    return Ok(SearchHits::new());
                };
                let mut hits = first.evaluate(source)?;
                for word in iter {
                    if hits.is_empty() {
                        break;
                    }
                    let next = word.evaluate(source)?;
                    hits = hits.pairwise(&next, |l, r| r == l + 1);
                }
                Ok(hits)
            }
        }
    }
}

fn before(left: u32, right: u32, nearness: u32) -> bool {
    right.saturating_sub(nearness) <= left && left <= right
}

fn after(left: u32, right: u32, nearness: u32) -> bool {
    right <= left && left <= right.saturating_add(nearness)
}

/// Whole-string match of `pattern`, where `*` matches any run of characters.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;
    while ti < t.len() {
        if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ti));
            pi += 1;
        } else if pi < p.len() && p[pi] == t[ti] {
            pi += 1;
            ti += 1;
        } else if let Some((sp, st)) = star {
            pi = sp + 1;
            ti = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|&c| c == '*')
}

impl fmt::Display for SearchExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchExpr::Word(w) => f.write_str(w),
            SearchExpr::Disjunction(parts) => {
                f.write_str("(")?;
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{part}")?;
                }
                f.write_str(")")
            }
            SearchExpr::Conjunction {
                op,
                lhs,
                rhs,
                nearness,
            } => {
                if *nearness != DEFAULT_NEARNESS {
                    write!(f, "({lhs} {}[{nearness}] {rhs})", op.symbol())
                } else {
                    write!(f, "({lhs} {} {rhs})", op.symbol())
                }
            }
            SearchExpr::Phrase(words) => {
                f.write_str("\"")?;
                for (i, word) in words.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{word}")?;
                }
                f.write_str("\"")
            }
        }
    }
}
