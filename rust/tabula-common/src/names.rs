//! Identifier validation for datasets, columns and filters.
//!
//! A valid name starts with an ASCII letter, `_` or `-`, followed by any number
//! of ASCII letters, digits, `_`, `$` or `-`.

use crate::{Result, error::Error};

/// Checks that `name` is usable as an identifier of the given `kind`
/// (e.g. "dataset", "column").
pub fn check_name_ok(kind: &str, name: &str) -> Result<()> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(Error::invalid_name(format!("{kind} has no name")));
    };
    let first_ok = first.is_ascii_alphabetic() || first == '_' || first == '-';
    let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '-'));
    if first_ok && rest_ok {
        Ok(())
    } else {
        Err(Error::invalid_name(format!(
            "{kind} name '{name}' contains illegal characters"
        )))
    }
}
