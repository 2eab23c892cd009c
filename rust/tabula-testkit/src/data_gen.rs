//! Synthetic patient records.
//!
//! Records resemble hospital discharge data: a mix of categorical codes,
//! scalar measures, dates, multi-valued diagnoses and free-text notes.
//! Absent fields model nulls. Generation is deterministic for a seed.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use tabula_store::{DataType, Value};

/// One source row: column name to value, nulls omitted.
pub type Record = BTreeMap<String, Value>;

const SEXES: &[&str] = &["M", "F"];
const DIAGNOSES: &[&str] = &["A01", "A02", "B15", "C34", "E11", "I21", "J45"];
const WORDS: &[&str] = &[
    "the", "quick", "brown", "fox", "jumps", "over", "lazy", "dog", "patient", "admitted",
    "with", "chest", "pain", "fever", "cough", "discharged", "home", "stable",
];

/// Column names and datatypes of the records from [`generate_patients`].
pub fn patient_schema() -> Vec<(&'static str, DataType)> {
    vec![
        ("sex", DataType::Str),
        ("agegrp", DataType::Int),
        ("age", DataType::Int),
        ("weight", DataType::Float),
        ("admitted", DataType::Date),
        ("diag", DataType::Tuple),
        ("notes", DataType::Str),
    ]
}

/// Generates `count` records from `seed`.
pub fn generate_patients(count: usize, seed: u64) -> Vec<Record> {
    let mut rng = fastrand::Rng::with_seed(seed);
    let base = NaiveDate::from_ymd_opt(2004, 1, 1).unwrap_or_default();
    (0..count)
        .map(|_| {
            let mut record = Record::new();
            if rng.u8(..10) != 0 {
                record.insert("sex".into(), Value::str(SEXES[rng.usize(..SEXES.len())]));
            }
            let age = rng.i64(0..100);
            record.insert("age".into(), Value::Int(age));
            record.insert("agegrp".into(), Value::Int(age / 20 + 1));
            if rng.u8(..8) != 0 {
                let weight = (rng.f64() * 900.0).round() / 10.0 + 2.0;
                record.insert("weight".into(), Value::float(weight));
            }
            record.insert(
                "admitted".into(),
                Value::Date(base + Duration::days(rng.i64(0..365))),
            );
            let diag: Vec<Value> = (0..rng.usize(0..4))
                .map(|_| Value::str(DIAGNOSES[rng.usize(..DIAGNOSES.len())]))
                .collect();
            record.insert("diag".into(), Value::Tuple(diag));
            if rng.u8(..4) != 0 {
                let words: Vec<&str> = (0..rng.usize(3..12))
                    .map(|_| WORDS[rng.usize(..WORDS.len())])
                    .collect();
                record.insert("notes".into(), Value::str(words.join(" ")));
            }
            record
        })
        .collect()
}

/// The values of `column` across `records`, `None` where absent.
pub fn column_values(records: &[Record], column: &str) -> Vec<Option<Value>> {
    records.iter().map(|r| r.get(column).cloned()).collect()
}
