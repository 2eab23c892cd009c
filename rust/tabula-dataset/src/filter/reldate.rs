//! `reldate(...)` literals: dates relative to today.

use chrono::{Datelike, Duration, Months, NaiveDate, Weekday};
use tabula_common::{Result, error::Error};
use tabula_store::Value;

/// Resolves `reldate` keyword arguments against `today`.
///
/// At most one of `years`, `months` or `days` offsets the date. `align` then
/// moves it to the start of the month (`bom`, `som`, `1st`), the start of the
/// year (`boy`, `soy`), or back to the named weekday on or before it.
pub fn resolve(kwargs: &[(String, Value)], today: NaiveDate) -> Result<NaiveDate> {
    let mut years = 0i64;
    let mut months = 0i64;
    let mut days = 0i64;
    let mut align: Option<String> = None;
    for (key, value) in kwargs {
        match key.to_ascii_lowercase().as_str() {
            "years" => years = int_arg(key, value)?,
            "months" => months = int_arg(key, value)?,
            "days" => days = int_arg(key, value)?,
            "align" => match value {
                Value::Str(s) => align = Some(s.to_ascii_lowercase()),
                other => {
                    return Err(Error::expression(format!(
                        "reldate align must be a string, got {}",
                        other.repr()
                    )));
                }
            },
            _ => {
                return Err(Error::expression(format!(
                    "unknown reldate argument '{key}'"
                )));
            }
        }
    }
    if [years, months, days].iter().filter(|v| **v != 0).count() > 1 {
        return Err(Error::expression(
            "Only specify one of years, months, or days",
        ));
    }

    let overflow = || Error::expression("reldate offset out of range");
    let mut date = today;
    if years != 0 {
        date = add_months(date, years * 12).ok_or_else(overflow)?;
    } else if months != 0 {
        date = add_months(date, months).ok_or_else(overflow)?;
    } else if days != 0 {
        date = date
            .checked_add_signed(Duration::try_days(days).ok_or_else(overflow)?)
            .ok_or_else(overflow)?;
    }

    if let Some(align) = align {
        date = match align.as_str() {
            "bom" | "som" | "1st" => date.with_day(1).ok_or_else(overflow)?,
            "boy" | "soy" => NaiveDate::from_ymd_opt(date.year(), 1, 1).ok_or_else(overflow)?,
            other => match other.parse::<Weekday>() {
                Ok(weekday) => {
                    let back = (7 + date.weekday().num_days_from_monday()
                        - weekday.num_days_from_monday())
                        % 7;
                    date - Duration::days(back as i64)
                }
                Err(_) => {
                    return Err(Error::expression(format!(
                        "bad relative date alignment '{other}'"
                    )));
                }
            },
        };
    }
    Ok(date)
}

fn int_arg(key: &str, value: &Value) -> Result<i64> {
    value.as_i64().ok_or_else(|| {
        Error::expression(format!(
            "reldate {key} must be an integer, got {}",
            value.repr()
        ))
    })
}

fn add_months(date: NaiveDate, months: i64) -> Option<NaiveDate> {
    let magnitude = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
    if months >= 0 {
        date.checked_add_months(magnitude)
    } else {
        date.checked_sub_months(magnitude)
    }
}
