//! Configuration, crosstab and multi-step pipelines.

mod test_data_gen;

use tabula_core::prelude::{AbsentKeyPolicy, Column, EngineConfig, Error, Kind, Table, Value};
use tabula_operators::aggregate::{AggSpec, AggregateOp, Reducer};
use tabula_operators::codec::FactorizeOp;
use tabula_operators::crosstab::crosstab;
use tabula_operators::expand::ExpandOp;
use tabula_operators::{OpError, Pipeline};
use test_data_gen::{column_ints, movies, strings};

#[test]
fn test_config_defaults() {
    let cfg = EngineConfig::default();
    assert_eq!(cfg.delimiter, ",");
    assert!(cfg.skip_absent);
    assert_eq!(cfg.absent_keys, AbsentKeyPolicy::Group);
    assert_eq!(cfg.merge_suffixes, ("_left".to_string(), "_right".to_string()));
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_config_from_yaml() {
    let cfg = EngineConfig::from_yaml_str(
        r#"
delimiter: "|"
skip_absent: false
absent_keys: drop
merge_suffixes: [".x", ".y"]
"#,
    )
    .expect("yaml");
    assert_eq!(cfg.delimiter, "|");
    assert!(!cfg.skip_absent);
    assert_eq!(cfg.absent_keys, AbsentKeyPolicy::Drop);
    assert_eq!(cfg.merge_suffixes.0, ".x");
    assert_eq!(cfg.indicator_prefix, None);
}

#[test]
fn test_config_rejects_bad_values() {
    assert!(matches!(
        EngineConfig::from_yaml_str("delimiter: \"\""),
        Err(Error::Config(_))
    ));
    assert!(matches!(
        EngineConfig::from_yaml_str("merge_suffixes: [\"_a\", \"_a\"]"),
        Err(Error::Config(_))
    ));
    assert!(matches!(
        EngineConfig::from_yaml_str("absent_keys: sometimes"),
        Err(Error::Config(_))
    ));
}

#[test]
fn test_config_from_env() {
    std::env::set_var("TABULA_DELIMITER", ";");
    std::env::set_var("TABULA_ABSENT_KEYS", "drop");
    std::env::set_var("TABULA_SKIP_ABSENT", "nonsense");
    let cfg = EngineConfig::from_env();
    std::env::remove_var("TABULA_DELIMITER");
    std::env::remove_var("TABULA_ABSENT_KEYS");
    std::env::remove_var("TABULA_SKIP_ABSENT");

    assert_eq!(cfg.delimiter, ";");
    assert_eq!(cfg.absent_keys, AbsentKeyPolicy::Drop);
    // Unparseable values fall back to the default.
    assert!(cfg.skip_absent);
}

#[test]
fn test_crosstab_counts_pairs() {
    let decade = Column::text(
        "decade",
        vec![Some("90s"), Some("80s"), Some("90s"), Some("90s"), Some("80s"), Some("80s")],
    );
    let table = movies().with_column(decade).unwrap();

    let out = crosstab(&table, "rating", "decade").expect("crosstab");
    assert_eq!(out.column_names(), vec!["rating", "90s", "80s"]);
    // Rows: PG, R, NA, G.
    assert_eq!(column_ints(&out, "90s"), vec![Some(2), Some(0), Some(1), Some(0)]);
    assert_eq!(column_ints(&out, "80s"), vec![Some(0), Some(2), Some(0), Some(1)]);

    assert!(crosstab(&table, "rating", "nope").is_err());
}

#[test]
fn test_crosstab_column_names_stay_unique() {
    let table = Table::new(vec![
        Column::text("g", vec![Some("a"), Some("b"), Some("a")]),
        Column::text("h", vec![Some("NA"), None, Some("g")]),
    ])
    .unwrap();

    let out = crosstab(&table, "g", "h").expect("crosstab");
    assert_eq!(out.column_names(), vec!["g", "NA", "NA_2", "g_2"]);
    assert_eq!(column_ints(&out, "NA"), vec![Some(1), Some(0)]);
    assert_eq!(column_ints(&out, "NA_2"), vec![Some(0), Some(1)]);
    assert_eq!(column_ints(&out, "g_2"), vec![Some(1), Some(0)]);
}

#[test]
fn test_pipeline_plans_and_runs_in_order() {
    let pipeline = Pipeline::new()
        .then(FactorizeOp {
            column: "rating".into(),
            levels: Some(strings(&["G", "PG", "R"])),
        })
        .then(ExpandOp::new("genres"))
        .then(AggregateOp::new(
            vec!["rating".into()],
            vec![
                AggSpec::new("Drama", Reducer::Sum),
                AggSpec::new("score", Reducer::Max),
            ],
        ));
    assert_eq!(pipeline.len(), 3);

    // Indicator columns depend on the data, so the aggregate step cannot be
    // planned against the schema alone.
    let err = pipeline.plan(&movies().schema()).unwrap_err();
    assert!(matches!(err, OpError::Plan(msg) if msg.starts_with("aggregate")));

    let out = pipeline.run(movies()).expect("run");
    assert_eq!(out.column_names(), vec!["rating", "sum_Drama", "max_score"]);

    let rating = out.column("rating").unwrap();
    assert_eq!(rating.kind(), Kind::Factor);
    assert_eq!(rating.label(0), Some("PG"));
    // PG: "Drama, Comedy" and absent.
    assert_eq!(column_ints(&out, "sum_Drama")[0], Some(1));
    assert_eq!(out.column("max_score").unwrap().get(1), Some(&Value::Real(9.0)));
}

#[test]
fn test_pipeline_stops_at_failing_step() {
    let pipeline = Pipeline::new()
        .then(ExpandOp::new("missing"))
        .then(ExpandOp::new("genres"));
    assert!(pipeline.run(movies()).is_err());
    assert!(Pipeline::new().run(movies()).is_ok());
}
