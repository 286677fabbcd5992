use std::fs;

use afcs::config::AfcsConfig;
use afcs::range_table::interpolation::InterpolationMode;
use afcs::range_table::Trajectory;
use afcs::solver::{FireQuery, Solver};
use camino::Utf8PathBuf;

mod common;
use common::{assert_solution_close, TablesDir, THREE_ROWS, TWO_ROWS};

const CONFIG: &str = r#"
interpolation = "linear"

[limits]
solution_limit = 2

[systems.M109A6]
low_charges = [3, 1, 7]

[systems.Dana]
file_prefix = "DANA"
"#;

fn write_config(tables: &TablesDir) -> AfcsConfig {
    let path = tables.root().join("afcs.toml");
    fs::write(&path, CONFIG).unwrap();
    AfcsConfig::load_with(Some(&path), None, None).unwrap()
}

#[test]
fn test_config_file_overrides_defaults() {
    let tables = TablesDir::new();
    let config = write_config(&tables);

    assert_eq!(config.interpolation, InterpolationMode::Linear);
    assert_eq!(config.limits.solution_limit, 2);
    assert_eq!(config.file_prefix("Dana"), "DANA");
    assert_eq!(config.file_prefix("RM-70"), "RM70");
    assert_eq!(
        config.charge_overrides("M109A6", Trajectory::Low),
        Some(&[3, 1, 7][..])
    );
    assert_eq!(config.charge_overrides("M109A6", Trajectory::High), None);
    assert_eq!(
        config.tables_dir_with(None, Some("/srv/tables".into())),
        Utf8PathBuf::from("/srv/tables")
    );
}

#[test]
fn test_charge_overrides_replace_discovery() {
    let tables = TablesDir::new()
        .with_file("M109A6_rangeTable_low_1.csv", THREE_ROWS)
        .with_file("M109A6_rangeTable_low_2.csv", TWO_ROWS)
        .with_file("M109A6_rangeTable_low_3.csv", TWO_ROWS);
    let config = write_config(&tables);
    let solver = Solver::from_dir(config, tables.root());

    let query = FireQuery::builder("M109A6", 1500.0)
        .trajectory(Some(Trajectory::Low))
        .build()
        .unwrap();
    let solutions = solver.solve(&query).unwrap();

    let charges: Vec<u32> = solutions.low.iter().map(|s| s.charge).collect();
    assert_eq!(charges, [3, 1]);
    assert_solution_close(&solutions.low[1], 15.0, 7.5, 1e-12);
}

#[test]
fn test_missing_override_table_is_a_warning() {
    let tables = TablesDir::new().with_file("M109A6_rangeTable_low_1.csv", TWO_ROWS);
    let config = write_config(&tables);
    let solver = Solver::from_dir(config, tables.root());

    let query = FireQuery::builder("M109A6", 1500.0)
        .trajectory(Some(Trajectory::Low))
        .build()
        .unwrap();
    let solutions = solver.solve(&query).unwrap();

    assert_eq!(solutions.low.len(), 1);
    assert_eq!(solutions.low[0].charge, 1);
    assert!(solutions.warnings.iter().any(|w| w.contains("charge 3")));
    assert!(solutions.warnings.iter().any(|w| w.contains("charge 7")));
}

#[test]
fn test_solution_limit_caps_each_trajectory() {
    let tables = TablesDir::new()
        .with_file("M119_rangeTable_high_1.csv", TWO_ROWS)
        .with_file("M119_rangeTable_high_2.csv", TWO_ROWS)
        .with_file("M119_rangeTable_high_3.csv", TWO_ROWS);
    let config = write_config(&tables);
    let solver = Solver::from_dir(config, tables.root());

    let query = FireQuery::builder("M119", 1500.0).build().unwrap();
    let solutions = solver.solve(&query).unwrap();
    let charges: Vec<u32> = solutions.high.iter().map(|s| s.charge).collect();
    assert_eq!(charges, [1, 2]);
    assert!(solutions.low.is_empty());
}
