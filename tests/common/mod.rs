#![allow(dead_code)]
use std::fs;

use afcs::range_table::RangeRow;
use afcs::solver::RangeSolution;
use approx::assert_relative_eq;
use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;

pub const TWO_ROWS: &str = "range,mill,diff100m,eta\n1000,10,1,5\n2000,20,2,10\n";

pub const THREE_ROWS: &str =
    "range,mill,diff100m,eta\n1000,10,1,5\n2000,20,2,10\n3000,35,1.5,14\n";

/// A temporary `rangeTables` directory, removed on drop.
pub struct TablesDir {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl TablesDir {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("temporary directory");
        let root = Utf8Path::from_path(dir.path())
            .expect("UTF-8 temporary directory")
            .join("rangeTables");
        fs::create_dir(&root).expect("create rangeTables");
        TablesDir { _dir: dir, root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn with_file(self, name: &str, content: &str) -> Self {
        fs::write(self.root.join(name), content).expect("write table");
        self
    }

    pub fn with_subdir(self, name: &str) -> Self {
        fs::create_dir(self.root.join(name)).expect("create subdirectory");
        self
    }
}

pub fn assert_solution_close(actual: &RangeSolution, mill: f64, eta: f64, epsilon: f64) {
    assert_relative_eq!(actual.mill, mill, epsilon = epsilon);
    assert_relative_eq!(actual.eta, eta, epsilon = epsilon);
}

pub fn assert_row_close(actual: &RangeRow, expected: &RangeRow, epsilon: f64) {
    assert_relative_eq!(actual.range, expected.range, epsilon = epsilon);
    assert_relative_eq!(actual.mill, expected.mill, epsilon = epsilon);
    assert_relative_eq!(actual.diff100m, expected.diff100m, epsilon = epsilon);
    assert_relative_eq!(actual.eta, expected.eta, epsilon = epsilon);
}
