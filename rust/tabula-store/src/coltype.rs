//! Column roles.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tabula_common::{Result, error::Error};

/// The role a column plays in a dataset. The role decides which indexes are
/// built at store time and which filter operators the column accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColType {
    /// Unique or near-unique values (record keys). No index.
    Identity,
    /// Unordered discrete values, indexed by value.
    Categorical,
    /// Ordered discrete values, indexed by value.
    Ordinal,
    /// Continuous measure, evaluated by direct comparison.
    Scalar,
    /// Scalar used to weight other measures.
    Weighting,
    /// Free text indexed by word into a postings file.
    SearchableText,
    /// The synthetic `row_ordinal` column.
    RowOrdinal,
}

impl ColType {
    pub fn name(&self) -> &'static str {
        match self {
            ColType::Identity => "identity",
            ColType::Categorical => "categorical",
            ColType::Ordinal => "ordinal",
            ColType::Scalar => "scalar",
            ColType::Weighting => "weighting",
            ColType::SearchableText => "searchabletext",
            ColType::RowOrdinal => "row_ordinal",
        }
    }

    /// Discrete columns own an inverted index and can serve as crosstab axes.
    pub fn is_discrete(&self) -> bool {
        matches!(self, ColType::Categorical | ColType::Ordinal)
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, ColType::Scalar | ColType::Weighting)
    }

    pub fn is_ordered(&self) -> bool {
        matches!(self, ColType::Ordinal | ColType::Scalar | ColType::Weighting)
    }

    pub fn is_weighting(&self) -> bool {
        *self == ColType::Weighting
    }

    pub fn is_searchabletext(&self) -> bool {
        *self == ColType::SearchableText
    }
}

impl fmt::Display for ColType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ColType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "identity" | "noncategorical" => Ok(ColType::Identity),
            "categorical" => Ok(ColType::Categorical),
            "ordinal" => Ok(ColType::Ordinal),
            "scalar" => Ok(ColType::Scalar),
            "weighting" => Ok(ColType::Weighting),
            "searchabletext" => Ok(ColType::SearchableText),
            "row_ordinal" => Ok(ColType::RowOrdinal),
            _ => Err(Error::invalid_arg(
                "coltype",
                format!("'{s}' is not a valid column type"),
            )),
        }
    }
}
