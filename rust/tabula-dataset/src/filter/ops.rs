//! Filter operators and the per-role capability table.

use std::fmt;

use tabula_store::ColType;

/// Every comparison the filter language can express.
///
/// The `*Prefix` variants compare the formatted key truncated to the length
/// of the formatted literal ("column" comparisons, written with a trailing
/// `:`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    EqualPrefix,
    NotEqualPrefix,
    LessPrefix,
    LessEqualPrefix,
    GreaterPrefix,
    GreaterEqualPrefix,
    Between,
    In,
    NotIn,
    InPrefix,
    NotInPrefix,
    Contains,
}

impl Operator {
    pub fn name(&self) -> &'static str {
        match self {
            Operator::Equal => "equal",
            Operator::NotEqual => "not equal",
            Operator::Less => "less than",
            Operator::LessEqual => "less than or equal",
            Operator::Greater => "greater than",
            Operator::GreaterEqual => "greater than or equal",
            Operator::EqualPrefix => "starting with",
            Operator::NotEqualPrefix => "not starting with",
            Operator::LessPrefix => "less than:",
            Operator::LessEqualPrefix => "less than or equal:",
            Operator::GreaterPrefix => "greater than:",
            Operator::GreaterEqualPrefix => "greater than or equal:",
            Operator::Between => "between",
            Operator::In => "in",
            Operator::NotIn => "not in",
            Operator::InPrefix => "in:",
            Operator::NotInPrefix => "not in:",
            Operator::Contains => "contains",
        }
    }

    /// The prefix variant, for operators that have one.
    pub fn prefix(self) -> Option<Operator> {
        Some(match self {
            Operator::Equal => Operator::EqualPrefix,
            Operator::NotEqual => Operator::NotEqualPrefix,
            Operator::Less => Operator::LessPrefix,
            Operator::LessEqual => Operator::LessEqualPrefix,
            Operator::Greater => Operator::GreaterPrefix,
            Operator::GreaterEqual => Operator::GreaterEqualPrefix,
            Operator::In => Operator::InPrefix,
            Operator::NotIn => Operator::NotInPrefix,
            _ => return None,
        })
    }

    pub fn is_prefix(&self) -> bool {
        matches!(
            self,
            Operator::EqualPrefix
                | Operator::NotEqualPrefix
                | Operator::LessPrefix
                | Operator::LessEqualPrefix
                | Operator::GreaterPrefix
                | Operator::GreaterEqualPrefix
                | Operator::InPrefix
                | Operator::NotInPrefix
        )
    }

    /// Operators whose literal is a list.
    pub fn takes_list(&self) -> bool {
        matches!(
            self,
            Operator::In | Operator::NotIn | Operator::InPrefix | Operator::NotInPrefix
        )
    }

    /// The plain comparison a `*Prefix` operator applies to formatted keys.
    pub fn base(self) -> Operator {
        match self {
            Operator::EqualPrefix => Operator::Equal,
            Operator::NotEqualPrefix => Operator::NotEqual,
            Operator::LessPrefix => Operator::Less,
            Operator::LessEqualPrefix => Operator::LessEqual,
            Operator::GreaterPrefix => Operator::Greater,
            Operator::GreaterEqualPrefix => Operator::GreaterEqual,
            Operator::InPrefix => Operator::In,
            Operator::NotInPrefix => Operator::NotIn,
            other => other,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which operators a column role can evaluate.
pub trait OperatorSupport {
    fn supports(&self, op: Operator) -> bool;
}

impl OperatorSupport for ColType {
    fn supports(&self, op: Operator) -> bool {
        use Operator::*;
        match self {
            ColType::Identity => false,
            ColType::Categorical | ColType::Ordinal => op != Contains,
            ColType::Scalar | ColType::Weighting => matches!(
                op,
                Equal | NotEqual | Less | LessEqual | Greater | GreaterEqual | Between
            ),
            ColType::SearchableText => op == Contains,
            ColType::RowOrdinal => matches!(
                op,
                Equal | Less | LessEqual | Greater | GreaterEqual | Between | In
            ),
        }
    }
}
