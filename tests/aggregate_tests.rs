//! Group aggregator: partitioning, reducers and absent handling.

mod test_data_gen;

use tabula_core::prelude::{AbsentKeyPolicy, Column, Error, Kind, Table, Value};
use tabula_operators::aggregate::{aggregate, group_by, AggSpec, AggregateOp, GroupBy, Reducer};
use tabula_operators::codec::encode;
use tabula_operators::Operator;
use test_data_gen::{column_ints, movies, strings, text_values};

fn keys(names: &[&str]) -> Vec<String> {
    strings(names)
}

#[test]
fn test_mean_skips_absent_by_default() {
    let table = Table::new(vec![
        Column::text("g", vec![Some("a"), Some("a"), Some("a")]),
        Column::int("v", vec![Some(2), None, Some(4)]),
    ])
    .unwrap();
    let groups = group_by(&table, &keys(&["g"])).unwrap();
    let target = table.column("v").unwrap();

    let skipped = aggregate(&groups, target, Reducer::Mean, true).unwrap();
    assert_eq!(skipped.get(&[Value::from("a")]), Some(&Value::Real(3.0)));

    let strict = aggregate(&groups, target, Reducer::Mean, false).unwrap();
    assert_eq!(strict.get(&[Value::from("a")]), Some(&Value::Absent));
}

#[test]
fn test_all_absent_group_reduces_to_absent() {
    let table = Table::new(vec![
        Column::text("g", vec![Some("a"), Some("b")]),
        Column::real("v", vec![Some(1.0), None]),
    ])
    .unwrap();
    let groups = group_by(&table, &keys(&["g"])).unwrap();
    for reducer in [Reducer::Mean, Reducer::Sum, Reducer::Count, Reducer::Min, Reducer::Max] {
        let agg = aggregate(&groups, table.column("v").unwrap(), reducer, true).unwrap();
        assert_eq!(agg.get(&[Value::from("b")]), Some(&Value::Absent), "{reducer}");
    }
}

#[test]
fn test_count_sum_equals_rows_when_absent_keys_group() {
    let table = movies();
    let groups = group_by(&table, &keys(&["rating"])).unwrap();
    let counts = aggregate(&groups, table.column("id").unwrap(), Reducer::Count, true).unwrap();

    let total: i64 = counts
        .iter()
        .map(|(_, v)| match v {
            Value::Int(n) => *n,
            other => panic!("count must be an integer, got {other:?}"),
        })
        .sum();
    assert_eq!(total as usize, table.num_rows());
    assert!(groups.get(&[Value::Absent]).is_some());
}

#[test]
fn test_count_sum_equals_present_key_rows_when_dropping() {
    let table = movies();
    let groups = GroupBy::new(&table, &keys(&["rating"]), AbsentKeyPolicy::Drop).unwrap();
    let counts = aggregate(&groups, table.column("id").unwrap(), Reducer::Count, true).unwrap();

    let total: i64 = counts.iter().filter_map(|(_, v)| v.as_f64()).sum::<f64>() as i64;
    let present = table.num_rows() - table.column("rating").unwrap().count_absent();
    assert_eq!(total as usize, present);
    assert!(groups.get(&[Value::Absent]).is_none());
}

#[test]
fn test_groups_iterate_in_first_appearance_order() {
    let table = movies();
    let groups = group_by(&table, &keys(&["rating"])).unwrap();
    let order: Vec<Value> = groups.iter().map(|(k, _)| k[0].clone()).collect();
    assert_eq!(
        order,
        vec![
            Value::from("PG"),
            Value::from("R"),
            Value::Absent,
            Value::from("G")
        ]
    );
    assert_eq!(groups.get(&[Value::from("R")]), Some(&[1usize, 5][..]));
}

#[test]
fn test_multi_key_grouping() {
    let table = Table::new(vec![
        Column::text("sex", vec![Some("f"), Some("m"), Some("f"), Some("f")]),
        Column::text("smoker", vec![Some("y"), Some("n"), Some("y"), Some("n")]),
        Column::real("tip", vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)]),
    ])
    .unwrap();
    let groups = group_by(&table, &keys(&["sex", "smoker"])).unwrap();
    assert_eq!(groups.len(), 3);

    let sums = aggregate(&groups, table.column("tip").unwrap(), Reducer::Sum, true).unwrap();
    assert_eq!(
        sums.get(&[Value::from("f"), Value::from("y")]),
        Some(&Value::Real(4.0))
    );

    let out = sums.into_table().unwrap();
    assert_eq!(out.column_names(), vec!["sex", "smoker", "sum_tip"]);
    assert_eq!(out.num_rows(), 3);
}

#[test]
fn test_factor_key_groups_by_label_and_keeps_levels() {
    let levels = strings(&["low", "high", "unused"]);
    let size = encode(
        "size",
        &text_values(&[Some("high"), Some("low"), Some("high")]),
        Some(&levels),
    )
    .unwrap();
    let table = Table::new(vec![size, Column::int("n", vec![Some(1), Some(2), Some(3)])]).unwrap();

    let groups = group_by(&table, &keys(&["size"])).unwrap();
    let agg = aggregate(&groups, table.column("n").unwrap(), Reducer::Max, true).unwrap();
    assert_eq!(agg.get(&[Value::from("high")]), Some(&Value::Int(3)));

    let out = agg.into_table().unwrap();
    let key = out.column("size").unwrap();
    assert!(key.is_factor());
    assert_eq!(key.levels().unwrap().to_vec(), levels);
    assert_eq!(key.label(0), Some("high"));
}

#[test]
fn test_min_max_and_integer_sum() {
    let table = Table::new(vec![
        Column::text("g", vec![Some("a"), Some("a"), Some("a")]),
        Column::int("v", vec![Some(5), Some(-2), Some(9)]),
    ])
    .unwrap();
    let groups = group_by(&table, &keys(&["g"])).unwrap();
    let v = table.column("v").unwrap();
    let key = [Value::from("a")];

    let get = |r| aggregate(&groups, v, r, true).unwrap().get(&key).cloned();
    assert_eq!(get(Reducer::Min), Some(Value::Int(-2)));
    assert_eq!(get(Reducer::Max), Some(Value::Int(9)));
    assert_eq!(get(Reducer::Sum), Some(Value::Int(12)));
    assert_eq!(get(Reducer::Count), Some(Value::Int(3)));
}

#[test]
fn test_boolean_mean_is_proportion_of_trues() {
    let table = Table::new(vec![
        Column::text("g", vec![Some("a"), Some("a"), Some("a"), Some("a")]),
        Column::boolean("flag", vec![Some(true), Some(false), Some(true), Some(true)]),
    ])
    .unwrap();
    let groups = group_by(&table, &keys(&["g"])).unwrap();
    let agg = aggregate(&groups, table.column("flag").unwrap(), Reducer::Mean, true).unwrap();
    assert_eq!(agg.get(&[Value::from("a")]), Some(&Value::Real(0.75)));
}

#[test]
fn test_invalid_reducers() {
    let table = movies();
    let groups = group_by(&table, &keys(&["rating"])).unwrap();
    let err = aggregate(&groups, table.column("genres").unwrap(), Reducer::Mean, true).unwrap_err();
    assert!(matches!(err, Error::InvalidReducer(_)));

    assert!(matches!(
        "median".parse::<Reducer>(),
        Err(Error::InvalidReducer(_))
    ));
    assert_eq!(Reducer::Sum.output_kind("x", Kind::Real).unwrap(), Kind::Real);
}

#[test]
fn test_unknown_key_and_short_target() {
    let table = movies();
    assert!(matches!(
        group_by(&table, &keys(&["nope"])),
        Err(Error::UnknownColumn(c)) if c == "nope"
    ));

    let groups = group_by(&table, &keys(&["rating"])).unwrap();
    let short = Column::int("v", vec![Some(1)]);
    assert!(matches!(
        aggregate(&groups, &short, Reducer::Sum, true),
        Err(Error::ShapeMismatch { .. })
    ));
}

#[test]
fn test_aggregate_op_builds_one_row_per_group() {
    let op = AggregateOp::new(
        keys(&["rating"]),
        vec![
            AggSpec::new("score", Reducer::Mean),
            AggSpec::new("id", Reducer::Count).alias("movies"),
        ],
    );

    let plan = op.plan(&[movies().schema()]).expect("plan");
    let names: Vec<&str> = plan.output_schema.names().collect();
    assert_eq!(names, vec!["rating", "mean_score", "movies"]);
    assert_eq!(plan.partitions, keys(&["rating"]));

    let out = op.eval(&[movies()]).expect("eval");
    assert_eq!(out.num_rows(), 4);
    assert_eq!(column_ints(&out, "movies"), vec![Some(2), Some(2), Some(1), Some(1)]);
    assert_eq!(
        out.column("mean_score").unwrap().get(1),
        Some(&Value::Real(7.5))
    );
}

#[test]
fn test_aggregate_op_plan_rejects_bad_reducer() {
    let op = AggregateOp::new(keys(&["rating"]), vec![AggSpec::new("genres", Reducer::Sum)]);
    assert!(op.plan(&[movies().schema()]).is_err());
}

#[test]
fn test_count_with_absent_targets() {
    let table = Table::new(vec![
        Column::text("g", vec![Some("a"), Some("a"), Some("b")]),
        Column::int("v", vec![Some(1), None, Some(2)]),
    ])
    .unwrap();
    let groups = group_by(&table, &keys(&["g"])).unwrap();
    let v = table.column("v").unwrap();

    let skipped = aggregate(&groups, v, Reducer::Count, true).unwrap();
    assert_eq!(skipped.get(&[Value::from("a")]), Some(&Value::Int(1)));
    let total: i64 = skipped.iter().filter_map(|(_, v)| v.as_f64()).sum::<f64>() as i64;
    // Counts present targets, not rows.
    assert_eq!(total as usize, table.num_rows() - v.count_absent());

    let strict = aggregate(&groups, v, Reducer::Count, false).unwrap();
    assert_eq!(strict.get(&[Value::from("a")]), Some(&Value::Absent));
    assert_eq!(strict.get(&[Value::from("b")]), Some(&Value::Int(1)));
}

#[test]
fn test_result_named_like_a_key_is_rejected() {
    let table = movies();
    let groups = group_by(&table, &keys(&["rating"])).unwrap();
    let agg = aggregate(&groups, table.column("id").unwrap(), Reducer::Count, true)
        .unwrap()
        .with_name("rating");
    assert!(matches!(
        agg.into_table(),
        Err(Error::DuplicateColumn(name)) if name == "rating"
    ));
}

#[test]
fn test_integer_factor_key_table_keeps_levels() {
    let table = Table::new(vec![
        encode("year", &[Value::Int(1999), Value::Int(2001), Value::Int(1999)], None).unwrap(),
        Column::real("score", vec![Some(1.0), Some(2.0), Some(3.0)]),
    ])
    .unwrap();
    let groups = group_by(&table, &keys(&["year"])).unwrap();
    let out = aggregate(&groups, table.column("score").unwrap(), Reducer::Sum, true)
        .unwrap()
        .into_table()
        .unwrap();

    let year = out.column("year").unwrap();
    assert_eq!(year.levels(), table.column("year").unwrap().levels());
    assert_eq!(year.label(0), Some("1999"));
    assert_eq!(out.column("sum_score").unwrap().get(0), Some(&Value::Real(4.0)));
}
