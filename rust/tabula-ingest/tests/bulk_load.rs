use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tabula_common::error::ErrorKind;
use tabula_dataset::{ColumnDef, Dataset, DatasetView, StorageOptions};
use tabula_ingest::{DatasetLoad, IngestOptions, Record, RowSource, VecSource, load_source, load_sources};
use tabula_store::{ColType, DataType, Value};
use tabula_testkit::{dirs::storage_root, generate_patients, patient_schema};

fn source(records: Vec<Record>) -> VecSource {
    named_source("patients.csv", records)
}

fn named_source(name: &str, records: Vec<Record>) -> VecSource {
    let columns = patient_schema()
        .into_iter()
        .map(|(name, datatype)| (name.to_string(), datatype))
        .collect();
    VecSource::new(name, columns, records)
}

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

fn files(dir: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    fn walk(root: &Path, dir: &Path, out: &mut BTreeMap<PathBuf, Vec<u8>>) {
        for entry in std::fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                walk(root, &path, out);
            } else {
                let rel = path.strip_prefix(root).unwrap().to_path_buf();
                out.insert(rel, std::fs::read(&path).unwrap());
            }
        }
    }
    let mut out = BTreeMap::new();
    walk(dir, dir, &mut out);
    out
}

#[test]
fn test_chunking_is_transparent() {
    let (_dir, root) = storage_root().unwrap();
    let storage = StorageOptions::new(&root);
    let records = generate_patients(120, 5);

    let mut outputs = Vec::new();
    for (chunk_rows, workers) in [(0, 1), (1, 1), (120, 1), (7, 3)] {
        let name = format!("load_{chunk_rows}_{workers}");
        let mut ds = Dataset::create(&storage, &name).unwrap();
        define(&mut ds);
        let options = IngestOptions::default()
            .with_chunk_rows(chunk_rows)
            .with_workers(workers);
        let summary = load_source(&mut ds, &mut source(records.clone()), &options).unwrap();
        assert_eq!(summary.rows, 120);
        assert_eq!(summary.generation, 1);
        let path = ds.path().unwrap().to_path_buf();
        assert!(!path.join("chunks").exists());
        outputs.push(files(&path.join("1")));
    }
    assert!(!outputs[0].is_empty());
    for other in &outputs[1..] {
        assert_eq!(other.keys().collect::<Vec<_>>(), outputs[0].keys().collect::<Vec<_>>());
        assert!(other == &outputs[0]);
    }
}

#[test]
fn test_loaded_dataset_filters_and_reopens() {
    let (_dir, root) = storage_root().unwrap();
    let storage = StorageOptions::new(&root);
    let records = generate_patients(300, 8);
    {
        let mut ds = Dataset::create(&storage, "nhds").unwrap();
        define(&mut ds);
        let options = IngestOptions::default().with_chunk_rows(64);
        let summary = load_source(&mut ds, &mut source(records.clone()), &options).unwrap();
        assert_eq!(summary.chunks, 5);
    }
    let ds = Dataset::open(&storage, "nhds").unwrap();
    assert_eq!(ds.len(), 300);

    let expected: Vec<u32> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| {
            r.get("sex") == Some(&Value::str("F"))
                && r.get("age").and_then(Value::as_i64).is_some_and(|a| a < 40)
        })
        .map(|(i, _)| i as u32)
        .collect();
    let view = ds.filter("sex = 'F' and age < 40").unwrap();
    assert_eq!(view.ids().as_slice(), expected.as_slice());

    let with_fox: Vec<u32> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| {
            r.get("notes")
                .and_then(Value::as_str)
                .is_some_and(|n| n.split(' ').any(|w| w == "fox"))
        })
        .map(|(i, _)| i as u32)
        .collect();
    assert_eq!(
        ds.filter("notes contains [[fox]]").unwrap().ids().as_slice(),
        with_fox.as_slice()
    );
}

#[test]
fn test_reload_bumps_generation() {
    let (_dir, root) = storage_root().unwrap();
    let storage = StorageOptions::new(&root);
    let mut ds = Dataset::create(&storage, "nhds").unwrap();
    define(&mut ds);
    let options = IngestOptions::default();
    load_source(&mut ds, &mut source(generate_patients(50, 1)), &options).unwrap();
    ds.define_filter("women", "sex = 'F'", None, None).unwrap();

    let records = generate_patients(80, 2);
    let limited = options.clone().with_row_limit(60);
    let summary = load_source(&mut ds, &mut source(records.clone()), &limited).unwrap();
    assert_eq!(summary.generation, 2);
    assert_eq!(summary.rows, 60);
    assert_eq!(ds.len(), 60);
    assert_eq!(ds.column("notes").unwrap().coltype(), ColType::SearchableText);

    let women = ds.get_filter("women").unwrap();
    let expected = records[..60]
        .iter()
        .filter(|r| r.get("sex") == Some(&Value::str("F")))
        .count();
    assert_eq!(women.meta.generation, 2);
    assert_eq!(women.record_ids.len(), expected);
}

#[test]
fn test_failed_load_commits_nothing() {
    let (_dir, root) = storage_root().unwrap();
    let storage = StorageOptions::new(&root);
    let mut ds = Dataset::create(&storage, "nhds").unwrap();
    define(&mut ds);
    let options = IngestOptions::default().with_chunk_rows(10).with_workers(2);
    load_source(&mut ds, &mut source(generate_patients(30, 3)), &options).unwrap();

    let mut records = generate_patients(40, 4);
    records[25].insert("age".to_string(), Value::str("forty"));
    let err = load_source(&mut ds, &mut source(records), &options).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::StoreType { row: 25, .. }), "{err}");

    assert_eq!(ds.generation(), 1);
    assert_eq!(ds.len(), 30);
    let path = ds.path().unwrap().to_path_buf();
    assert!(!path.join("2").exists());
    assert!(!path.join("chunks").exists());
    drop(ds);
    let reopened = Dataset::open(&storage, "nhds").unwrap();
    assert_eq!(reopened.generation(), 1);
    assert_eq!(reopened.len(), 30);
}

#[test]
fn test_declared_type_mismatch_rejected() {
    let mut ds = Dataset::new("nhds").unwrap();
    define(&mut ds);
    let mut bad = VecSource::new(
        "bad.csv",
        vec![("age".to_string(), DataType::Str)],
        Vec::new(),
    );
    let err = load_source(&mut ds, &mut bad, &IngestOptions::default()).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::InvalidArgument { .. }));
    assert_eq!(ds.generation(), 0);
}

#[test]
fn test_unbacked_load_uses_declared_columns() {
    let mut ds = Dataset::new("scratch").unwrap();
    let options = IngestOptions::default().with_chunk_rows(16);
    let records = generate_patients(40, 6);
    load_source(&mut ds, &mut source(records.clone()), &options).unwrap();
    assert_eq!(ds.len(), 40);
    assert_eq!(ds.column_names().len(), patient_schema().len());
    assert_eq!(ds.column("weight").unwrap().coltype(), ColType::Scalar);
    let age = ds.get_column("age").unwrap();
    assert_eq!(age.get(17).unwrap(), records[17].get("age").cloned());
}

#[test]
fn test_unlocked_dataset_rejected() {
    let (_dir, root) = storage_root().unwrap();
    let storage = StorageOptions::new(&root);
    drop(Dataset::create(&storage, "nhds").unwrap());
    let mut ds = Dataset::open(&storage, "nhds").unwrap();
    let err = load_source(&mut ds, &mut source(Vec::new()), &IngestOptions::default()).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::InvalidOperation { .. }));
}

#[test]
fn test_sources_share_one_generation() {
    let (_dir, root) = storage_root().unwrap();
    let storage = StorageOptions::new(&root);
    let first = generate_patients(70, 11);
    let second = generate_patients(50, 12);
    {
        let mut ds = Dataset::create(&storage, "nhds").unwrap();
        define(&mut ds);
        let options = IngestOptions::default().with_chunk_rows(32);
        let mut a = named_source("2004.csv", first.clone());
        let mut b = named_source("2005.csv", second.clone());
        let summary = load_sources(
            &mut ds,
            [&mut a as &mut dyn RowSource, &mut b as &mut dyn RowSource],
            &options,
        )
        .unwrap();
        assert_eq!(summary.sources, vec!["2004.csv".to_string(), "2005.csv".to_string()]);
        assert_eq!(summary.rows, 120);
        assert_eq!(summary.chunks, 4);
        assert_eq!(summary.generation, 1);
    }

    let ds = Dataset::open(&storage, "nhds").unwrap();
    assert_eq!(ds.len(), 120);
    let records: Vec<&Record> = first.iter().chain(second.iter()).collect();
    let age = ds.get_column("age").unwrap();
    for row in [0, 69, 70, 119] {
        assert_eq!(age.get(row).unwrap(), records[row].get("age").cloned(), "row {row}");
    }
    let expected: Vec<u32> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| r.get("sex") == Some(&Value::str("M")))
        .map(|(i, _)| i as u32)
        .collect();
    assert_eq!(ds.filter("sex = 'M'").unwrap().ids().as_slice(), expected.as_slice());
}

#[test]
fn test_row_limit_spans_sources() {
    let mut ds = Dataset::new("scratch").unwrap();
    define(&mut ds);
    let options = IngestOptions::default().with_row_limit(90);
    let mut load = DatasetLoad::begin(&mut ds, &options).unwrap();
    assert_eq!(load.add_source(&mut source(generate_patients(70, 1))).unwrap(), 70);
    assert_eq!(load.add_source(&mut source(generate_patients(70, 2))).unwrap(), 20);
    assert_eq!(load.rows(), 90);
    let summary = load.finish().unwrap();
    assert_eq!(summary.rows, 90);
    assert_eq!(ds.len(), 90);
}

#[test]
fn test_each_source_checked() {
    let (_dir, root) = storage_root().unwrap();
    let storage = StorageOptions::new(&root);
    let mut ds = Dataset::create(&storage, "nhds").unwrap();
    define(&mut ds);
    let path = ds.path().unwrap().to_path_buf();
    let mut good = source(generate_patients(20, 5));
    let mut bad = VecSource::new(
        "bad.csv",
        vec![("age".to_string(), DataType::Str)],
        Vec::new(),
    );
    let err = load_sources(
        &mut ds,
        [&mut good as &mut dyn RowSource, &mut bad as &mut dyn RowSource],
        &IngestOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::InvalidArgument { .. }));
    assert_eq!(ds.generation(), 0);
    assert_eq!(ds.len(), 0);
    assert!(!path.join("1").exists());
}

#[test]
fn test_unfinished_load_leaves_no_generation() {
    let (_dir, root) = storage_root().unwrap();
    let storage = StorageOptions::new(&root);
    let mut ds = Dataset::create(&storage, "nhds").unwrap();
    define(&mut ds);
    let path = ds.path().unwrap().to_path_buf();
    {
        let options = IngestOptions::default().with_chunk_rows(8);
        let mut load = DatasetLoad::begin(&mut ds, &options).unwrap();
        load.add_source(&mut source(generate_patients(30, 7))).unwrap();
        assert!(path.join("1").is_dir());
        assert!(path.join("chunks").is_dir());
    }
    assert!(!path.join("1").exists());
    assert!(!path.join("chunks").exists());
    assert_eq!(ds.generation(), 0);

    let mut load = DatasetLoad::begin(&mut ds, &IngestOptions::default()).unwrap();
    let mut records = generate_patients(10, 8);
    records[3].insert("age".to_string(), Value::str("old"));
    load.add_source(&mut source(records)).unwrap();
    assert!(load.finish().is_err());
    assert!(!path.join("1").exists());
    assert_eq!(ds.generation(), 0);
}

#[test]
fn test_single_retained_generation_keeps_loaded_rows() {
    let (_dir, root) = storage_root().unwrap();
    let storage = StorageOptions::new(&root).with_generations(0);
    let mut ds = Dataset::create(&storage, "nhds").unwrap();
    define(&mut ds);
    let records = generate_patients(1, 9);
    let summary = load_source(&mut ds, &mut source(records.clone()), &IngestOptions::default()).unwrap();
    assert_eq!(summary.generation, 1);
    let path = ds.path().unwrap().to_path_buf();
    assert!(path.join("1").is_dir());
    assert!(!path.join("0").exists());
    assert_eq!(
        ds.column("sex").unwrap().data().unwrap().get(0),
        records[0].get("sex").cloned()
    );
}
