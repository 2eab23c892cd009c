use std::collections::BTreeMap;

use tabula_common::error::ErrorKind;
use tabula_crosstab::{CrossTab, CrossTabAxis, CrossTabExt, shape_union};
use tabula_dataset::{ColumnDef, Dataset, DatasetView};
use tabula_store::{ColType, DataType, Value};

fn summary(name: &str, rows: &[(i64, &str, i64)]) -> Dataset {
    let mut ds = Dataset::new(name).unwrap();
    ds.add_column_from_values(
        ColumnDef::new("agegrp", DataType::Int)
            .with_coltype(ColType::Ordinal)
            .with_label("Age group"),
        rows.iter().map(|r| Some(Value::Int(r.0))),
    )
    .unwrap();
    ds.add_column_from_values(
        ColumnDef::new("sex", DataType::Str).with_label("Sex"),
        rows.iter().map(|r| Some(Value::str(r.1))),
    )
    .unwrap();
    ds.add_column_from_values(
        ColumnDef::new("freq", DataType::Int).with_coltype(ColType::Scalar),
        rows.iter().map(|r| Some(Value::Int(r.2))),
    )
    .unwrap();
    ds
}

#[test]
fn test_collapse_to_single_axis() {
    let ds = summary("summ", &[(1, "M", 3), (1, "F", 2), (2, "M", 5)]);
    let mut xtab = ds.crosstab().unwrap();
    assert_eq!(xtab.shape(), vec![2, 2]);
    assert_eq!(xtab.axes()[1].values, vec![Value::str("F"), Value::str("M")]);
    assert_eq!(xtab.get_table("freq").unwrap().data.get(&[1, 0]), None);

    let target = vec![xtab.axes()[0].clone()];
    xtab.collapse_axes_not_in(&target).unwrap();
    assert_eq!(xtab.shape(), vec![2]);
    let freq = &xtab.get_table("freq").unwrap().data;
    assert_eq!(freq.get(&[0]), Some(5.0));
    assert_eq!(freq.get(&[1]), Some(5.0));
}

#[test]
fn test_null_axis_value_leaves_row_out() {
    let mut ds = Dataset::new("summ").unwrap();
    ds.add_column_from_values(
        ColumnDef::new("sex", DataType::Str),
        [Some(Value::str("M")), None, Some(Value::str("F"))],
    )
    .unwrap();
    ds.add_column_from_values(
        ColumnDef::new("freq", DataType::Int).with_coltype(ColType::Scalar),
        [4, 7, 1].map(|v| Some(Value::Int(v))),
    )
    .unwrap();
    let xtab = ds.crosstab().unwrap();
    let freq = &xtab.get_table("freq").unwrap().data;
    assert_eq!(freq.sum(), 5.0);
    assert_eq!(freq.count(), 2);
}

#[test]
fn test_no_discrete_columns() {
    let mut ds = Dataset::new("summ").unwrap();
    ds.add_column_from_values(
        ColumnDef::new("freq", DataType::Float),
        [Some(Value::float(1.0))],
    )
    .unwrap();
    let err = ds.crosstab().unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::InvalidOperation { .. }));
}

fn random_summary(seed: u64) -> (Dataset, BTreeMap<(i64, String, i64), i64>) {
    let mut rng = fastrand::Rng::with_seed(seed);
    let mut cells = BTreeMap::new();
    for a in 1..=3 {
        for b in ["x", "y"] {
            for c in 0..4 {
                if rng.f64() < 0.75 {
                    cells.insert((a, b.to_string(), c), rng.i64(0..100));
                }
            }
        }
    }
    let mut ds = Dataset::new(format!("rand{seed}")).unwrap();
    ds.add_column_from_values(
        ColumnDef::new("a", DataType::Int),
        cells.keys().map(|k| Some(Value::Int(k.0))),
    )
    .unwrap();
    ds.add_column_from_values(
        ColumnDef::new("b", DataType::Str),
        cells.keys().map(|k| Some(Value::str(k.1.as_str()))),
    )
    .unwrap();
    ds.add_column_from_values(
        ColumnDef::new("c", DataType::Int).with_coltype(ColType::Ordinal),
        cells.keys().map(|k| Some(Value::Int(k.2))),
    )
    .unwrap();
    ds.add_column_from_values(
        ColumnDef::new("n", DataType::Int).with_coltype(ColType::Scalar),
        cells.values().map(|v| Some(Value::Int(*v))),
    )
    .unwrap();
    (ds, cells)
}

#[test]
fn test_collapse_sums_over_dropped_axis() {
    for seed in [3, 17, 2024] {
        let (ds, cells) = random_summary(seed);
        let full = ds.crosstab().unwrap();
        let target = vec![full.axes()[0].clone(), full.axes()[2].clone()];
        let mut collapsed = full.clone();
        collapsed.collapse_axes_not_in(&target).unwrap();
        assert_eq!(collapsed.axes(), target.as_slice());

        let mut expected: BTreeMap<(i64, i64), f64> = BTreeMap::new();
        for ((a, _, c), n) in &cells {
            *expected.entry((*a, *c)).or_default() += *n as f64;
        }
        let table = &collapsed.get_table("n").unwrap().data;
        for (i, a) in target[0].values.iter().enumerate() {
            for (k, c) in target[1].values.iter().enumerate() {
                let key = (a.as_i64().unwrap(), c.as_i64().unwrap());
                assert_eq!(table.get(&[i, k]), expected.get(&key).copied(), "seed {seed}");
            }
        }
        assert_eq!(table.sum(), full.get_table("n").unwrap().data.sum());
    }
}

#[test]
fn test_replicate_restores_shape() {
    let (ds, _) = random_summary(11);
    let full = ds.crosstab().unwrap();
    let target = vec![full.axes()[0].clone(), full.axes()[2].clone()];
    let mut collapsed = full.clone();
    collapsed.collapse_axes_not_in(&target).unwrap();

    let mut replicated = collapsed.clone();
    replicated.replicate_axes(full.axes()).unwrap();
    assert_eq!(replicated.shape(), full.shape());
    assert_eq!(replicated.axes(), full.axes());
    let small = &collapsed.get_table("n").unwrap().data;
    let wide = &replicated.get_table("n").unwrap().data;
    for i in 0..full.shape()[0] {
        for j in 0..full.shape()[1] {
            for k in 0..full.shape()[2] {
                assert_eq!(wide.get(&[i, j, k]), small.get(&[i, k]));
            }
        }
    }
}

#[test]
fn test_replicate_rejects_changed_values() {
    let ds = summary("summ", &[(1, "M", 3), (2, "F", 2)]);
    let mut xtab = ds.crosstab().unwrap();
    let mut target = xtab.axes().to_vec();
    target[1].values.push(Value::str("U"));
    let err = xtab.replicate_axes(&target).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::AxisMismatch { .. }));
    assert_eq!(xtab.shape(), vec![2, 2]);
}

#[test]
fn test_summset_round_trip() {
    let ds = summary("summ", &[(1, "M", 3), (1, "F", 2), (2, "M", 5)]);
    let xtab = ds.crosstab().unwrap();
    let summset = xtab.to_summset("summ_flat").unwrap();
    assert_eq!(summset.len(), 3);
    assert_eq!(
        summset.column_names(),
        vec!["agegrp".to_string(), "sex".to_string(), "freq".to_string()]
    );
    let freq = summset.get_column("freq").unwrap();
    assert_eq!(freq.datatype(), DataType::Float);
    assert_eq!(summset.get_column("sex").unwrap().label(), "Sex");

    let again = CrossTab::from_summset(&summset, Some(xtab.axes())).unwrap();
    assert_eq!(again.axes(), xtab.axes());
    assert_eq!(
        again.get_table("freq").unwrap().data,
        xtab.get_table("freq").unwrap().data
    );
}

#[test]
fn test_views_crosstab() {
    let ds = summary("summ", &[(1, "M", 3), (1, "F", 2), (2, "M", 5), (2, "F", 8)]);
    let males = ds.filter("sex = 'M'").unwrap();
    let xtab = males.crosstab().unwrap();
    assert_eq!(xtab.shape(), vec![2, 1]);
    assert_eq!(xtab.get_table("freq").unwrap().data.sum(), 8.0);

    let union = shape_union(xtab.axes(), ds.crosstab().unwrap().axes());
    assert!(union.is_err());
    let axes: Vec<CrossTabAxis> = CrossTab::axes_of(&ds).unwrap();
    assert_eq!(axes.len(), 2);
}

#[test]
fn test_summset_keeps_value_labels() {
    let mut ds = Dataset::new("summ").unwrap();
    ds.add_column_from_values(
        ColumnDef::new("sex", DataType::Int)
            .with_outtrans(vec![
                (Value::Int(1), "Male".to_string()),
                (Value::Int(2), "Female".to_string()),
            ])
            .with_all(Value::Int(0), "Persons"),
        [1, 2, 0].map(|v| Some(Value::Int(v))),
    )
    .unwrap();
    ds.add_column_from_values(
        ColumnDef::new("freq", DataType::Int).with_coltype(ColType::Scalar),
        [4, 6, 10].map(|v| Some(Value::Int(v))),
    )
    .unwrap();

    let xtab = ds.crosstab().unwrap();
    assert_eq!(xtab.axes()[0].all_label.as_deref(), Some("Persons"));
    let summset = xtab.to_summset("summ_flat").unwrap();
    let def = summset.column("sex").unwrap().def();
    assert_eq!(def.outtrans.len(), 2);
    assert_eq!(def.all_value, Some(Value::Int(0)));
    let sex = summset.get_column("sex").unwrap();
    assert_eq!(sex.do_outtrans(Some(&Value::Int(2))), "Female");
    assert_eq!(sex.do_outtrans(Some(&Value::Int(0))), "Persons");

    let again = CrossTab::from_summset(&summset, Some(xtab.axes())).unwrap();
    assert_eq!(again.axes(), xtab.axes());
}
