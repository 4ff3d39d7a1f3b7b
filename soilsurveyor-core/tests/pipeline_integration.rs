//! End-to-end profiling pipeline tests.
//!
//! This test suite covers:
//! - Union of heterogeneous exports with explicit absent cells
//! - Schema-version tagging and canonical column mapping
//! - Key-subset duplicate detection without removal
//! - IQR outlier flagging and Pearson correlation artifacts
//! - Categorical value frequencies and grouped numeric summaries
//! - Symbolic links and reserved column names during discovery and loading
//! - Configuration errors raised before any artifact is written
//! - Load failures recorded in diagnostics
//! - Byte-identical artifacts across repeated runs

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::uninlined_format_args)]

use std::path::Path;

use soilsurveyor_core::{
    CanonicalMapping, Cell, GroupBySpec, MissingnessHint, ProfileConfig, SchemaVersion,
    SurveyorError,
    emit::{
        CATEGORICAL_FREQUENCIES_FILE, COMBINED_FILE, DIAGNOSTICS_FILE, DUPLICATES_FILE,
        GROUPED_STATS_FILE, MISSINGNESS_FILE, OUTLIERS_FILE, STRONG_CORRELATIONS_FILE,
        TARGET_DRIVERS_FILE,
    },
    reconcile_sources, run,
};
use tempfile::TempDir;

/// Writes `(relative path, contents)` fixtures under a fresh input directory.
fn write_inputs(dir: &TempDir, files: &[(&str, &str)]) -> std::path::PathBuf {
    let input = dir.path().join("exports");
    for (name, contents) in files {
        let path = input.join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, contents).unwrap();
    }
    input
}

/// Reads a CSV artifact into header + records.
fn read_artifact(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let header = reader
        .headers()
        .unwrap()
        .iter()
        .map(str::to_string)
        .collect();
    let records = reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect();
    (header, records)
}

fn field<'a>(header: &[String], record: &'a [String], name: &str) -> &'a str {
    let idx = header
        .iter()
        .position(|h| h == name)
        .unwrap_or_else(|| panic!("missing column {}", name));
    &record[idx]
}

#[tokio::test]
async fn test_pipeline_unions_heterogeneous_exports() {
    let dir = TempDir::new().unwrap();
    let input = write_inputs(
        &dir,
        &[
            ("a.csv", "A,B\n1,x\n2,y\n"),
            ("b.csv", "A,C\n3,p\n4,q\n5,r\n"),
            ("c.csv", "B,C,D\nz,s,t\n"),
        ],
    );

    let reconciled = reconcile_sources(&input, &ProfileConfig::default())
        .await
        .unwrap();
    let table = &reconciled.table;

    assert_eq!(table.row_count(), 6);
    assert_eq!(table.columns(), ["A", "B", "C", "D"]);

    let c = table.column_position("C").unwrap();
    let a = table.column_position("A").unwrap();
    assert_eq!(table.cell(0, c), Some(&Cell::Absent));
    assert_eq!(table.cell(5, a), Some(&Cell::Absent));
    assert_eq!(table.cell(2, c), Some(&Cell::Value("p".to_string())));

    // Every column of every source table reaches the union
    for source in table.sources() {
        for column in &source.columns {
            assert!(table.has_column(column));
        }
    }
    let total: usize = table.sources().iter().map(|s| s.row_count).sum();
    assert_eq!(total, table.row_count());
}

#[tokio::test]
async fn test_pipeline_combined_artifact_keeps_provenance() {
    let dir = TempDir::new().unwrap();
    let input = write_inputs(
        &dir,
        &[
            ("batch_1/a.csv", "A,B\n1,x\n"),
            ("batch_2/b.csv", "A,C\n2,NA\n"),
        ],
    );
    let output = dir.path().join("out");

    run(&input, &output, ProfileConfig::default()).await.unwrap();

    let (header, records) = read_artifact(&output.join(COMBINED_FILE));
    assert_eq!(
        header,
        ["_row_id", "_source", "_batch", "_schema_version", "A", "B", "C"]
    );
    assert_eq!(records.len(), 2);
    assert_eq!(records[0], ["0", "batch_1/a.csv", "batch_1", "unknown", "1", "x", ""]);
    // Null sentinels keep their original text
    assert_eq!(records[1], ["1", "batch_2/b.csv", "batch_2", "unknown", "2", "", "NA"]);
}

#[tokio::test]
async fn test_pipeline_flags_single_upper_outlier() {
    let dir = TempDir::new().unwrap();
    let input = write_inputs(&dir, &[("ph.csv", "pH\n1\n2\n2\n3\n4\n5\n100\n")]);
    let output = dir.path().join("out");

    let summary = run(&input, &output, ProfileConfig::default()).await.unwrap();
    assert_eq!(summary.report.outliers.len(), 1);

    let (header, records) = read_artifact(&output.join(OUTLIERS_FILE));
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(field(&header, record, "row_id"), "6");
    assert_eq!(field(&header, record, "column"), "pH");
    assert_eq!(field(&header, record, "value"), "100");
    assert_eq!(field(&header, record, "bound"), "upper");
    assert_eq!(field(&header, record, "bound_value"), "8.25");
    assert_eq!(field(&header, record, "distance"), "91.75");
}

#[tokio::test]
async fn test_pipeline_reports_perfect_correlation() {
    let dir = TempDir::new().unwrap();
    let input = write_inputs(&dir, &[("xy.csv", "X,Y\n1,2\n2,4\n3,6\n4,8\n5,10\n")]);
    let output = dir.path().join("out");

    let summary = run(&input, &output, ProfileConfig::default()).await.unwrap();
    let r = summary.report.correlation.matrix.get("X", "Y").unwrap();
    assert!((r - 1.0).abs() < 1e-12, "r = {}", r);

    let (header, records) = read_artifact(&output.join(STRONG_CORRELATIONS_FILE));
    assert_eq!(records.len(), 1);
    assert_eq!(field(&header, &records[0], "column_a"), "X");
    assert_eq!(field(&header, &records[0], "column_b"), "Y");
    assert_eq!(field(&header, &records[0], "sign"), "positive");
    assert_eq!(field(&header, &records[0], "strength"), "near_perfect");
    assert_eq!(field(&header, &records[0], "observations"), "5");
}

#[tokio::test]
async fn test_pipeline_reports_key_duplicates_without_removal() {
    let dir = TempDir::new().unwrap();
    let input = write_inputs(
        &dir,
        &[(
            "labs.csv",
            "lab_id,date,pH\nL1,2024-01-01,6.1\nL1,2024-01-01,6.3\nL2,2024-01-01,6.1\n",
        )],
    );
    let output = dir.path().join("out");
    let config = ProfileConfig::new().with_duplicate_key_columns(["lab_id", "date"]);

    let summary = run(&input, &output, config).await.unwrap();

    assert!(summary.report.full_row_duplicates.is_empty());
    let keyed = summary.report.key_duplicates.as_ref().unwrap();
    assert_eq!(keyed.len(), 1);
    assert_eq!(keyed[0].rows, vec![0, 1]);
    assert_eq!(summary.diagnostics.rows, 3);

    let (header, records) = read_artifact(&output.join(DUPLICATES_FILE));
    assert_eq!(records.len(), 2);
    for (record, row_id) in records.iter().zip(["0", "1"]) {
        assert_eq!(field(&header, record, "key_mode"), "key");
        assert_eq!(field(&header, record, "group_size"), "2");
        assert_eq!(field(&header, record, "row_id"), row_id);
        assert_eq!(
            field(&header, record, "key_values"),
            r#"["L1","2024-01-01"]"#
        );
    }
}

#[tokio::test]
async fn test_pipeline_missing_target_fails_before_output() {
    let dir = TempDir::new().unwrap();
    let input = write_inputs(&dir, &[("a.csv", "pH,OM\n6.1,2.0\n6.5,2.4\n")]);
    let output = dir.path().join("out");
    let config = ProfileConfig::new().with_target_column("Soil Health Score");

    let err = run(&input, &output, config).await.unwrap_err();

    assert!(matches!(err, SurveyorError::Configuration { .. }));
    assert!(err.to_string().contains("Soil Health Score"));
    assert!(!output.exists());
}

#[tokio::test]
async fn test_pipeline_missingness_counts_cover_every_row() {
    let dir = TempDir::new().unwrap();
    let input = write_inputs(
        &dir,
        &[
            ("a.csv", "A,B\n1,\n2,n/a\n3,x\n"),
            ("b.csv", "A,C\n4,9\n,8\n"),
        ],
    );
    let output = dir.path().join("out");

    let summary = run(&input, &output, ProfileConfig::default()).await.unwrap();

    for profile in &summary.report.columns {
        let m = &profile.missingness;
        assert_eq!(
            m.non_missing + m.missing,
            summary.diagnostics.rows,
            "column {}",
            profile.name
        );
    }

    let (header, records) = read_artifact(&output.join(MISSINGNESS_FILE));
    let b = records
        .iter()
        .find(|r| field(&header, r, "column") == "B")
        .unwrap();
    assert_eq!(field(&header, b, "non_missing"), "1");
    assert_eq!(field(&header, b, "missing"), "4");
    assert_eq!(field(&header, b, "missing_pct"), "80");
    assert_eq!(field(&header, b, "tier"), "excluded");
}

#[tokio::test]
async fn test_pipeline_configured_missingness_hint() {
    let dir = TempDir::new().unwrap();
    let input = write_inputs(
        &dir,
        &[("a.csv", "Texture,Sand\nLoam,40\nClay,\nLoam,35\nSilt,20\n")],
    );
    let output = dir.path().join("out");
    let config = ProfileConfig::new().with_missingness_hint(
        "Sand",
        MissingnessHint::MarLike {
            sibling: Some("Texture".to_string()),
        },
    );

    run(&input, &output, config).await.unwrap();

    let (header, records) = read_artifact(&output.join(MISSINGNESS_FILE));
    let sand = records
        .iter()
        .find(|r| field(&header, r, "column") == "Sand")
        .unwrap();
    assert_eq!(field(&header, sand, "pattern"), "mar_like");
    assert_eq!(field(&header, sand, "pattern_basis"), "configured");
    assert_eq!(field(&header, sand, "sibling"), "Texture");

    let texture = records
        .iter()
        .find(|r| field(&header, r, "column") == "Texture")
        .unwrap();
    assert_eq!(field(&header, texture, "pattern"), "complete");
    assert_eq!(field(&header, texture, "pattern_basis"), "observed");
}

#[tokio::test]
async fn test_pipeline_tags_versions_and_maps_canonical_columns() {
    let dir = TempDir::new().unwrap();
    let input = write_inputs(
        &dir,
        &[
            (
                "2019/old.csv",
                "Lab No,Soil pH 1:1,\"Organic Matter, % LOI\"\n1,6.1,3.2\n2,6.4,3.0\n",
            ),
            (
                "2023/new.csv",
                "Lab No,1:1 Soil pH,Organic Matter\n3,6.8,2.9\n",
            ),
        ],
    );
    let output = dir.path().join("out");
    let config = ProfileConfig::new().with_column_mapping(
        CanonicalMapping::new("Soil pH")
            .with_source(SchemaVersion::V1, "Soil pH 1:1")
            .with_source(SchemaVersion::V2, "1:1 Soil pH"),
    );

    let summary = run(&input, &output, config).await.unwrap();

    assert_eq!(summary.diagnostics.schema_versions.get(&SchemaVersion::V1), Some(&1));
    assert_eq!(summary.diagnostics.schema_versions.get(&SchemaVersion::V2), Some(&1));

    let (header, records) = read_artifact(&output.join(COMBINED_FILE));
    let versions: Vec<&str> = records
        .iter()
        .map(|r| field(&header, r, "_schema_version"))
        .collect();
    assert_eq!(versions, ["v1", "v1", "v2"]);

    let canonical: Vec<&str> = records
        .iter()
        .map(|r| field(&header, r, "Soil pH"))
        .collect();
    assert_eq!(canonical, ["6.1", "6.4", "6.8"]);

    // Source columns are kept alongside the canonical one
    assert_eq!(field(&header, &records[2], "Soil pH 1:1"), "");
    assert_eq!(field(&header, &records[0], "1:1 Soil pH"), "");
}

#[tokio::test]
async fn test_pipeline_records_load_failures_in_diagnostics() {
    let dir = TempDir::new().unwrap();
    let input = write_inputs(
        &dir,
        &[
            ("bad.csv", "A,A\n1,2\n"),
            ("good.csv", "A,B\n1,2\n3,4\n"),
        ],
    );
    let output = dir.path().join("out");

    let summary = run(&input, &output, ProfileConfig::default()).await.unwrap();
    assert_eq!(summary.diagnostics.files_discovered, 2);
    assert_eq!(summary.diagnostics.files_loaded, 1);

    let text = std::fs::read_to_string(output.join(DIAGNOSTICS_FILE)).unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["files_discovered"], 2);
    assert_eq!(json["rows"], 2);
    assert_eq!(json["load_failures"][0]["source"], "bad.csv");
    assert_eq!(
        json["load_failures"][0]["reason"],
        "duplicate column name 'A'"
    );
}

#[tokio::test]
async fn test_pipeline_target_drivers_and_stale_cleanup() {
    let dir = TempDir::new().unwrap();
    let input = write_inputs(
        &dir,
        &[(
            "a.csv",
            "Score,OM,Sand\n10,1.0,50\n12,1.5,45\n15,2.1,41\n18,2.4,30\n20,3.0,28\n",
        )],
    );
    let output = dir.path().join("out");

    run(&input, &output, ProfileConfig::new().with_target_column("Score"))
        .await
        .unwrap();
    let (header, records) = read_artifact(&output.join(TARGET_DRIVERS_FILE));
    assert_eq!(records.len(), 2);
    assert_eq!(field(&header, &records[0], "rank"), "1");
    assert_eq!(field(&header, &records[0], "target"), "Score");

    run(&input, &output, ProfileConfig::default()).await.unwrap();
    assert!(!output.join(TARGET_DRIVERS_FILE).exists());
}

#[tokio::test]
async fn test_pipeline_artifacts_are_byte_identical_across_runs() {
    let dir = TempDir::new().unwrap();
    let input = write_inputs(
        &dir,
        &[
            ("batch_1/a.csv", "Lab No,pH,OM,Texture\n1,6.1,2.0,Loam\n2,6.4,2.2,Clay\n3,9.9,8.0,Loam\n"),
            ("batch_1/b.csv", "Lab No,pH,Score\n4,6.0,10\n5,6.3,NA\n5,6.3,NA\n"),
            ("batch_2/c.csv", "Lab No,OM,Score\n6,2.1,11\n7,,14\n8,2.6,15\n"),
        ],
    );
    let config = ProfileConfig::new()
        .with_target_column("pH")
        .with_duplicate_key_columns(["Lab No"])
        .with_strong_correlation_threshold(0.3)
        .with_group_by(GroupBySpec::new("Texture", ["pH", "OM"]));

    let first = dir.path().join("first");
    let second = dir.path().join("second");
    let a = run(&input, &first, config.clone()).await.unwrap();
    let b = run(&input, &second, config).await.unwrap();

    assert_eq!(a.artifacts.len(), b.artifacts.len());
    for path in &a.artifacts {
        let name = path.file_name().unwrap();
        let left = std::fs::read(path).unwrap();
        let right = std::fs::read(second.join(name)).unwrap();
        assert_eq!(left, right, "{:?} differs between runs", name);
    }
    assert_eq!(a.report, b.report);
}

const COVER_CROPS: &str = "Cover,Score\nRye,10\nClover,20\nRye,14\nNA,30\nOats,12\nClover,24\nClover,22\n";

#[tokio::test]
async fn test_pipeline_writes_top_categorical_frequencies() {
    let dir = TempDir::new().unwrap();
    let input = write_inputs(&dir, &[("cover.csv", COVER_CROPS)]);
    let output = dir.path().join("out");

    run(&input, &output, ProfileConfig::new().with_frequency_top_n(2))
        .await
        .unwrap();

    let (header, records) = read_artifact(&output.join(CATEGORICAL_FREQUENCIES_FILE));
    assert_eq!(header, ["column", "value", "count", "pct", "rank"]);
    assert_eq!(records.len(), 2);
    // Six present cover values; the NA row is not counted
    assert_eq!(records[0], ["Cover", "Clover", "3", "50", "1"]);
    assert_eq!(field(&header, &records[1], "value"), "Rye");
    assert_eq!(field(&header, &records[1], "count"), "2");
    let pct: f64 = field(&header, &records[1], "pct").parse().unwrap();
    assert!((pct - 200.0 / 6.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_pipeline_writes_grouped_stats_by_mean() {
    let dir = TempDir::new().unwrap();
    let input = write_inputs(&dir, &[("cover.csv", COVER_CROPS)]);
    let output = dir.path().join("out");
    let config = ProfileConfig::new().with_group_by(GroupBySpec::new("Cover", ["Score"]));

    let summary = run(&input, &output, config).await.unwrap();
    assert_eq!(summary.report.grouped.len(), 3);

    let (header, records) = read_artifact(&output.join(GROUPED_STATS_FILE));
    let groups: Vec<&str> = records
        .iter()
        .map(|r| field(&header, r, "group_value"))
        .collect();
    // Oats and Rye share a mean of 12
    assert_eq!(groups, ["Clover", "Oats", "Rye"]);

    let clover = &records[0];
    assert_eq!(field(&header, clover, "value_column"), "Score");
    assert_eq!(field(&header, clover, "count"), "3");
    assert_eq!(field(&header, clover, "mean"), "22");
    assert_eq!(field(&header, clover, "median"), "22");
    assert_eq!(field(&header, clover, "std"), "2");
    assert_eq!(field(&header, clover, "min"), "20");
    assert_eq!(field(&header, clover, "max"), "24");
    assert_eq!(field(&header, &records[1], "std"), "");
}

#[tokio::test]
async fn test_pipeline_group_by_categorical_value_fails_before_output() {
    let dir = TempDir::new().unwrap();
    let input = write_inputs(&dir, &[("cover.csv", COVER_CROPS)]);
    let output = dir.path().join("out");
    let config = ProfileConfig::new().with_group_by(GroupBySpec::new("Score", ["Cover"]));

    let err = run(&input, &output, config).await.unwrap_err();

    assert!(matches!(err, SurveyorError::Configuration { .. }));
    assert!(!output.exists());
}

#[tokio::test]
async fn test_pipeline_rejects_provenance_column_names() {
    let dir = TempDir::new().unwrap();
    let input = write_inputs(
        &dir,
        &[
            ("clash.csv", "_source,pH\nlab,6.1\n"),
            ("good.csv", "pH\n6.4\n"),
        ],
    );
    let output = dir.path().join("out");

    let summary = run(&input, &output, ProfileConfig::default()).await.unwrap();
    assert_eq!(summary.diagnostics.files_loaded, 1);
    assert_eq!(summary.diagnostics.load_failures[0].source, "clash.csv");
    assert_eq!(
        summary.diagnostics.load_failures[0].reason,
        "column name '_source' is reserved"
    );

    let (header, _) = read_artifact(&output.join(COMBINED_FILE));
    assert_eq!(header, ["_row_id", "_source", "_batch", "_schema_version", "pH"]);
}

#[cfg(unix)]
#[tokio::test]
async fn test_pipeline_ignores_symbolic_links() {
    let dir = TempDir::new().unwrap();
    let input = write_inputs(
        &dir,
        &[("batch_1/a.csv", "pH\n6.1\n6.4\n"), ("batch_2/b.csv", "pH\n7.0\n")],
    );
    std::os::unix::fs::symlink(&input, input.join("batch_1/cycle")).unwrap();
    std::os::unix::fs::symlink(input.join("batch_2"), input.join("latest")).unwrap();
    let output = dir.path().join("out");

    let summary = run(&input, &output, ProfileConfig::default()).await.unwrap();

    assert_eq!(summary.diagnostics.files_discovered, 2);
    assert_eq!(summary.diagnostics.rows, 3);
    assert!(summary.diagnostics.load_failures.is_empty());
    let (_, records) = read_artifact(&output.join(COMBINED_FILE));
    assert_eq!(records.len(), 3);
}
