//! Display formatting of cell values.
//!
//! Columns carry a printf-style format string (`%d`, `%10.10g`, `%8.2f`, `%s`)
//! for numbers and strings, or a strftime-style one (`%Y-%m-%d`) for temporal
//! values. Prefix ("starting with") filter operators compare these formatted
//! renderings rather than raw values, so the output must be stable.

use chrono::format::{Item, StrftimeItems};

use crate::value::Value;

/// Formats `value` according to `format_str`. A `None` value renders as `"None"`.
///
/// Temporal values use strftime semantics; everything else uses the printf
/// subset described in the module docs. A format string that does not apply
/// to the value falls back to the value's plain display.
pub fn format_value(value: Option<&Value>, format_str: &str) -> String {
    let Some(value) = value else {
        return "None".to_string();
    };
    match value {
        Value::Date(d) => strftime(format_str, |items| d.format_with_items(items).to_string())
            .unwrap_or_else(|| value.to_string()),
        Value::Time(t) => strftime(format_str, |items| t.format_with_items(items).to_string())
            .unwrap_or_else(|| value.to_string()),
        Value::DateTime(dt) => {
            strftime(format_str, |items| dt.format_with_items(items).to_string())
                .unwrap_or_else(|| value.to_string())
        }
        _ => printf(format_str, value).unwrap_or_else(|| value.to_string()),
    }
}

fn strftime<F>(format_str: &str, render: F) -> Option<String>
where
    F: FnOnce(std::slice::Iter<'_, Item<'_>>) -> String,
{
    let items: Vec<Item<'_>> = StrftimeItems::new(format_str).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return None;
    }
    Some(render(items.iter()))
}

#[derive(Debug, Default, Clone, Copy)]
struct Spec {
    left: bool,
    zero: bool,
    plus: bool,
    width: usize,
    precision: Option<usize>,
    conv: char,
}

fn printf(format_str: &str, value: &Value) -> Option<String> {
    let mut out = String::new();
    let mut chars = format_str.chars().peekable();
    let mut consumed = false;
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        if chars.peek() == Some(&'%') {
            chars.next();
            out.push('%');
            continue;
        }
        let mut spec = Spec::default();
        while let Some(&flag) = chars.peek() {
            match flag {
                '-' => spec.left = true,
                '0' => spec.zero = true,
                '+' => spec.plus = true,
                ' ' | '#' => {}
                _ => break,
            }
            chars.next();
        }
        spec.width = take_number(&mut chars).unwrap_or(0);
        if chars.peek() == Some(&'.') {
            chars.next();
            spec.precision = Some(take_number(&mut chars).unwrap_or(0));
        }
        spec.conv = chars.next()?;
        if consumed {
            return None;
        }
        consumed = true;
        let body = convert(&spec, value)?;
        out.push_str(&pad(&spec, body));
    }
    Some(out)
}

fn take_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<usize> {
    let mut n: Option<usize> = None;
    while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
        n = Some(n.unwrap_or(0) * 10 + d as usize);
        chars.next();
    }
    n
}

fn convert(spec: &Spec, value: &Value) -> Option<String> {
    let sign = |s: String, negative: bool| {
        if spec.plus && !negative {
            format!("+{s}")
        } else {
            s
        }
    };
    match spec.conv {
        's' => {
            let s = value.to_string();
            Some(match spec.precision {
                Some(p) => s.chars().take(p).collect(),
                None => s,
            })
        }
        'd' | 'i' | 'u' => {
            let v = match value {
                Value::Int(v) => *v,
                Value::Float(f) => f.0.trunc() as i64,
                _ => return None,
            };
            Some(sign(v.to_string(), v < 0))
        }
        'f' | 'F' => {
            let v = value.as_f64()?;
            Some(sign(format!("{:.*}", spec.precision.unwrap_or(6), v), v < 0.0))
        }
        'e' | 'E' => {
            let v = value.as_f64()?;
            let s = format_exp(v, spec.precision.unwrap_or(6), false);
            let s = if spec.conv == 'E' { s.to_uppercase() } else { s };
            Some(sign(s, v < 0.0))
        }
        'g' | 'G' => {
            let v = value.as_f64()?;
            let s = format_general(v, spec.precision.unwrap_or(6));
            let s = if spec.conv == 'G' { s.to_uppercase() } else { s };
            Some(sign(s, v < 0.0))
        }
        _ => None,
    }
}

fn pad(spec: &Spec, body: String) -> String {
    let len = body.chars().count();
    if len >= spec.width {
        return body;
    }
    let fill = spec.width - len;
    if spec.left {
        format!("{body}{}", " ".repeat(fill))
    } else if spec.zero && spec.conv != 's' {
        let (sign, digits) = match body.strip_prefix('-') {
            Some(rest) => ("-", rest.to_string()),
            None => match body.strip_prefix('+') {
                Some(rest) => ("+", rest.to_string()),
                None => ("", body.clone()),
            },
        };
        format!("{sign}{}{digits}", "0".repeat(fill))
    } else {
        format!("{}{body}", " ".repeat(fill))
    }
}

/// C-style exponent notation: mantissa with `precision` decimals and a signed,
/// at least two-digit exponent (`1.500000e+01`).
fn format_exp(v: f64, precision: usize, strip_zeros: bool) -> String {
    if !v.is_finite() {
        return non_finite(v);
    }
    let raw = format!("{:.*e}", precision, v);
    let (mantissa, exp) = raw.split_once('e').unwrap_or((raw.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let mantissa = if strip_zeros {
        strip_fraction_zeros(mantissa)
    } else {
        mantissa.to_string()
    };
    let sign = if exp < 0 { '-' } else { '+' };
    format!("{mantissa}e{sign}{:02}", exp.abs())
}

/// C-style `%g`: `precision` significant digits, fixed or exponent notation
/// depending on the decimal exponent, trailing zeros removed.
fn format_general(v: f64, precision: usize) -> String {
    if !v.is_finite() {
        return non_finite(v);
    }
    let p = precision.max(1);
    if v == 0.0 {
        return "0".to_string();
    }
    let raw = format!("{:.*e}", p - 1, v);
    let exp: i32 = raw
        .split_once('e')
        .and_then(|(_, e)| e.parse().ok())
        .unwrap_or(0);
    if exp < -4 || exp >= p as i32 {
        format_exp(v, p - 1, true)
    } else {
        let decimals = (p as i32 - 1 - exp).max(0) as usize;
        strip_fraction_zeros(&format!("{:.*}", decimals, v))
    }
}

fn strip_fraction_zeros(s: &str) -> String {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s.to_string()
    }
}

fn non_finite(v: f64) -> String {
    if v.is_nan() {
        "nan".to_string()
    } else if v > 0.0 {
        "inf".to_string()
    } else {
        "-inf".to_string()
    }
}

/// Derives a fixed-point format for a float column from its largest magnitude,
/// keeping roughly ten significant characters.
pub fn derive_float_format(max_abs: Option<f64>) -> String {
    const WIDTH: f64 = 10.0;
    let Some(max) = max_abs else {
        return "%10.10g".to_string();
    };
    let decimals = if max > 0.0 {
        (WIDTH - max.log10() - 2.0).max(0.0) as usize
    } else {
        return "%10.10g".to_string();
    };
    format!("%{}.{}f", WIDTH as usize, decimals)
}
