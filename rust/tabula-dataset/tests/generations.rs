//! Backed datasets: persistence, generations, locking and saved filters.

use tabula_common::error::ErrorKind;
use tabula_dataset::{ColumnDef, Dataset, DatasetView, StorageOptions};
use tabula_store::{ColType, DataType, Value};
use tabula_testkit::dirs::storage_root;

fn ints(values: &[i64]) -> Vec<Option<Value>> {
    values.iter().map(|v| Some(Value::Int(*v))).collect()
}

fn load(ds: &mut Dataset, ages: &[i64]) {
    let sexes: Vec<Option<Value>> = ages
        .iter()
        .map(|a| Some(Value::str(if a % 2 == 0 { "F" } else { "M" })))
        .collect();
    ds.add_column_from_values(
        ColumnDef::new("sex", DataType::Str).with_coltype(ColType::Categorical),
        sexes,
    )
    .unwrap();
    ds.add_column_from_values(
        ColumnDef::new("age", DataType::Int).with_coltype(ColType::Scalar),
        ints(ages),
    )
    .unwrap();
    ds.save().unwrap();
}

#[test]
fn test_create_then_open() {
    let (_dir, root) = storage_root().unwrap();
    let options = StorageOptions::new(&root);
    {
        let mut ds = Dataset::create(&options, "nhds").unwrap();
        ds.set_label("Discharges");
        load(&mut ds, &[40, 25, 61, 33]);
    }
    for lazy in [true, false] {
        let ds = Dataset::open(&options.clone().with_lazy(lazy), "nhds").unwrap();
        assert_eq!(ds.len(), 4);
        assert_eq!(ds.label(), "Discharges");
        assert!(!ds.is_locked());
        assert_eq!(ds.filter("sex = 'M'").unwrap().ids().as_slice(), &[1, 2, 3]);
        assert_eq!(ds.filter("age >= 40").unwrap().ids().as_slice(), &[0, 2]);
    }

    let err = Dataset::create(&options, "nhds").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::InvalidOperation { .. }));
    let err = Dataset::open(&options, "missing").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::DatasetNotFound { .. }));
}

#[test]
fn test_single_writer() {
    let (_dir, root) = storage_root().unwrap();
    let options = StorageOptions::new(&root);
    let writer = Dataset::create(&options, "nhds").unwrap();

    let mut other = Dataset::open(&options, "nhds").unwrap();
    let err = other.lock().unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::DatasetLocked { .. }));
    assert!(other.new_generation().is_err());

    drop(writer);
    other.lock().unwrap();
    other.new_generation().unwrap();
    assert_eq!(other.generation(), 1);
}

#[test]
fn test_generations_move_and_reap() {
    let (_dir, root) = storage_root().unwrap();
    let options = StorageOptions::new(&root).with_generations(2);
    let mut ds = Dataset::create(&options, "nhds").unwrap();
    load(&mut ds, &[1, 2, 3]);
    let path = ds.path().unwrap().to_path_buf();
    assert!(path.join("0").is_dir());

    let mut seen = vec![ds.generation()];
    for round in 1..=3 {
        ds.new_generation().unwrap();
        assert_eq!(ds.len(), 0);
        assert!(ds.column_names().is_empty());
        load(&mut ds, &vec![round; 2 + round as usize]);
        seen.push(ds.generation());
    }
    assert!(seen.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(ds.generation(), 3);
    assert!(!path.join("0").exists());
    assert!(!path.join("1").exists());
    assert!(path.join("2").is_dir());
    assert!(path.join("3").is_dir());

    drop(ds);
    let reopened = Dataset::open(&options, "nhds").unwrap();
    assert_eq!(reopened.generation(), 3);
    assert_eq!(reopened.len(), 5);
}

#[test]
fn test_single_retained_generation_survives() {
    let (_dir, root) = storage_root().unwrap();
    let options = StorageOptions::new(&root).with_generations(0);
    let mut ds = Dataset::create(&options, "nhds").unwrap();
    assert_eq!(ds.generations(), 1);
    load(&mut ds, &[1, 2, 3]);
    ds.new_generation().unwrap();
    load(&mut ds, &[4, 5]);
    let path = ds.path().unwrap().to_path_buf();
    assert!(!path.join("0").exists());
    assert!(path.join("1").is_dir());
    assert_eq!(ds.column("age").unwrap().data().unwrap().get(1), Some(Value::Int(5)));

    drop(ds);
    let reopened = Dataset::open(&options, "nhds").unwrap();
    assert_eq!(reopened.len(), 2);
}

#[test]
fn test_saved_filter_follows_generation() {
    let (_dir, root) = storage_root().unwrap();
    let options = StorageOptions::new(&root);
    let mut ds = Dataset::create(&options, "nhds").unwrap();
    load(&mut ds, &[40, 25, 61, 33]);

    let males = ds
        .define_filter("males", "sex = 'M'", Some("Males"), None)
        .unwrap();
    assert_eq!(males.record_ids.as_slice(), &[1, 2, 3]);
    // the in-memory memo must not survive a generation change either
    assert_eq!(ds.filter("age > 30").unwrap().len(), 3);

    ds.new_generation().unwrap();
    load(&mut ds, &[11, 12, 14, 15, 17]);
    let males = ds.get_filter("males").unwrap();
    assert_eq!(males.meta.generation, ds.generation());
    assert_eq!(males.record_ids.as_slice(), &[0, 3, 4]);
    assert_eq!(ds.filter("age > 30").unwrap().len(), 0);
    drop(ds);

    let reopened = Dataset::open(&options, "nhds").unwrap();
    assert_eq!(reopened.filter_names(), vec!["males".to_string()]);
    let view = reopened.filter_dataset(Some("males"), None).unwrap();
    assert_eq!(view.label(), "Males");
    assert_eq!(view.ids().as_slice(), &[0, 3, 4]);
}

#[test]
fn test_column_rename_and_delete_backed() {
    let (_dir, root) = storage_root().unwrap();
    let options = StorageOptions::new(&root);
    let mut ds = Dataset::create(&options, "nhds").unwrap();
    load(&mut ds, &[40, 25, 61]);

    ds.rename_column("age", "age_years").unwrap();
    assert!(ds.column("age").is_none());
    assert_eq!(ds.filter("age_years < 50").unwrap().ids().as_slice(), &[0, 1]);
    ds.delete_column("sex").unwrap();
    ds.save().unwrap();
    drop(ds);

    let ds = Dataset::open(&options, "nhds").unwrap();
    assert_eq!(ds.column_names(), vec!["age_years".to_string()]);
    let err = ds.filter("sex = 'M'").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::ColumnNotFound { .. }));
}

#[test]
fn test_rename_dataset() {
    let (_dir, root) = storage_root().unwrap();
    let options = StorageOptions::new(&root);
    let mut ds = Dataset::create(&options, "nhds").unwrap();
    load(&mut ds, &[1, 2]);
    ds.define_filter("even", "sex = 'F'", None, None).unwrap();
    ds.rename("discharges").unwrap();
    assert_eq!(ds.name(), "discharges");
    assert_eq!(ds.get_filter("even").unwrap().record_ids.as_slice(), &[1]);
    drop(ds);

    assert!(Dataset::open(&options, "nhds").is_err());
    let ds = Dataset::open(&options, "discharges").unwrap();
    assert_eq!(ds.len(), 2);
}
