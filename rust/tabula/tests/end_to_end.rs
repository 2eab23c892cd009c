use std::collections::BTreeMap;

use tabula::common::rowset;
use tabula::prelude::*;
use tabula_testkit::{dirs::storage_root, generate_patients, patient_schema};

fn define(ds: &mut Dataset) {
    for (name, datatype) in patient_schema() {
        let coltype = match name {
            "age" | "weight" => ColType::Scalar,
            "admitted" => ColType::Ordinal,
            "notes" => ColType::SearchableText,
            _ => ColType::Categorical,
        };
        ds.add_column(ColumnDef::new(name, datatype).with_coltype(coltype))
            .unwrap();
    }
}

fn source(records: Vec<Record>) -> VecSource {
    let columns = patient_schema()
        .into_iter()
        .map(|(name, datatype)| (name.to_string(), datatype))
        .collect();
    VecSource::new("patients", columns, records)
}

#[test]
fn test_load_filter_crosstab() {
    let (_dir, root) = storage_root().unwrap();
    let storage = StorageOptions::new(&root);
    let records = generate_patients(400, 21);

    let mut ds = Dataset::create(&storage, "patients").unwrap();
    define(&mut ds);
    let options = IngestOptions::default().with_chunk_rows(100).with_workers(2);
    let summary = load_source(&mut ds, &mut source(records.clone()), &options).unwrap();
    assert_eq!(summary.rows, 400);
    drop(ds);

    let ds = Dataset::open(&storage, "patients").unwrap();
    let older_men = ds.filter("sex = 'M' and agegrp >= 3").unwrap();
    let expected: Vec<RowId> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| {
            r.get("sex") == Some(&Value::str("M"))
                && r.get("agegrp").and_then(Value::as_i64).is_some_and(|g| g >= 3)
        })
        .map(|(i, _)| i as RowId)
        .collect();
    assert_eq!(older_men.record_ids(), Some(expected.as_slice()));

    // frequency summary of the view by agegrp and sex
    let sex = older_men.get_column("sex").unwrap().inverted().unwrap();
    let agegrp = older_men.get_column("agegrp").unwrap().inverted().unwrap();
    let mut counts: BTreeMap<(Value, Value), usize> = BTreeMap::new();
    for (g, g_rows) in agegrp.iter() {
        for (s, s_rows) in sex.iter() {
            let n = rowset::intersect(g_rows, s_rows).len();
            if n > 0 {
                counts.insert((g.clone(), s.clone()), n);
            }
        }
    }
    let mut summ = Dataset::new("older_men_summ").unwrap();
    summ.add_column_from_values(
        ColumnDef::new("agegrp", DataType::Int),
        counts.keys().map(|k| Some(k.0.clone())),
    )
    .unwrap();
    summ.add_column_from_values(
        ColumnDef::new("sex", DataType::Str),
        counts.keys().map(|k| Some(k.1.clone())),
    )
    .unwrap();
    summ.add_column_from_values(
        ColumnDef::new("_freq_", DataType::Int).with_coltype(ColType::Scalar),
        counts.values().map(|n| Some(Value::Int(*n as i64))),
    )
    .unwrap();

    let mut xtab = summ.crosstab().unwrap();
    assert_eq!(xtab.axes().len(), 2);
    let total = xtab.get_table("_freq_").unwrap().data.sum();
    assert_eq!(total, expected.len() as f64);

    let target = vec![xtab.axes()[0].clone()];
    xtab.collapse_axes_not_in(&target).unwrap();
    let freq = &xtab.get_table("_freq_").unwrap().data;
    for (i, g) in target[0].values.iter().enumerate() {
        let n = expected
            .iter()
            .filter(|&&row| records[row as usize].get("agegrp") == Some(g))
            .count();
        assert_eq!(freq.get(&[i]), Some(n as f64));
    }
}

#[test]
fn test_text_search_in_view() {
    let records = generate_patients(150, 4);
    let mut ds = Dataset::new("scratch").unwrap();
    define(&mut ds);
    load_source(&mut ds, &mut source(records.clone()), &IngestOptions::default()).unwrap();

    let women = ds.filter("sex = 'F'").unwrap();
    let with_fever = women.filter("notes contains 'fever'").unwrap();
    let expected: Vec<RowId> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| {
            r.get("sex") == Some(&Value::str("F"))
                && r.get("notes")
                    .and_then(Value::as_str)
                    .is_some_and(|n| n.split_whitespace().any(|w| w == "fever"))
        })
        .map(|(i, _)| i as RowId)
        .collect();
    let ids = with_fever.record_ids().unwrap();
    assert_eq!(ids, expected.as_slice());
    let hits = women
        .get_column("notes")
        .unwrap()
        .search("fever", &SearchOptions::default())
        .unwrap();
    assert_eq!(hits.len(), ids.len());
}
