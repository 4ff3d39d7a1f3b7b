//! Artifact serialization.
//!
//! Each concern is written as its own CSV table with an explicit header,
//! plus a JSON diagnostics report. Output is a pure function of the table,
//! report and diagnostics: fixed column and row orders, shortest
//! round-trip float text, no timestamps.
//!
//! In `combined.csv` an absent cell (the column is not in the row's source
//! schema) is written as an empty field, the same text as an empty present
//! cell. Use `_source` with `sources.csv`, or `missingness.csv`, to tell
//! them apart. Null cells keep their original text, so a sentinel such as
//! `NA` round-trips.

use std::path::PathBuf;

use crate::error::{Result, SurveyorError};
use crate::models::{RESERVED_COLUMNS, UnifiedTable};
use crate::profile::{CorrelationPair, Diagnostics, DuplicateGroup, ProfileReport};

/// Combined reconciled rows
pub const COMBINED_FILE: &str = "combined.csv";
/// Loaded source metadata
pub const SOURCES_FILE: &str = "sources.csv";
/// Per-column missingness report
pub const MISSINGNESS_FILE: &str = "missingness.csv";
/// Per-column descriptive statistics
pub const COLUMN_PROFILES_FILE: &str = "column_profiles.csv";
/// Duplicate group membership
pub const DUPLICATES_FILE: &str = "duplicates.csv";
/// Flagged outlier values
pub const OUTLIERS_FILE: &str = "outliers.csv";
/// Per-column IQR fences
pub const OUTLIER_SUMMARY_FILE: &str = "outlier_summary.csv";
/// Square correlation matrix
pub const CORRELATION_MATRIX_FILE: &str = "correlation_matrix.csv";
/// Every upper-triangle pair
pub const CORRELATION_PAIRS_FILE: &str = "correlation_pairs.csv";
/// Pairs above the strong threshold
pub const STRONG_CORRELATIONS_FILE: &str = "strong_correlations.csv";
/// Most frequent values per categorical column
pub const CATEGORICAL_FREQUENCIES_FILE: &str = "categorical_frequencies.csv";
/// Numeric summaries per group
pub const GROUPED_STATS_FILE: &str = "grouped_stats.csv";
/// Target driver ranking
pub const TARGET_DRIVERS_FILE: &str = "target_drivers.csv";
/// Run diagnostics
pub const DIAGNOSTICS_FILE: &str = "diagnostics.json";

const PAIR_HEADER: [&str; 7] = [
    "column_a",
    "column_b",
    "r",
    "abs_r",
    "sign",
    "strength",
    "observations",
];

fn num(value: f64) -> String {
    value.to_string()
}

fn opt_num(value: Option<f64>) -> String {
    value.map(num).unwrap_or_default()
}

fn pair_fields(pair: &CorrelationPair) -> Vec<String> {
    vec![
        pair.column_a.clone(),
        pair.column_b.clone(),
        opt_num(pair.r),
        opt_num(pair.abs_r()),
        pair.sign().map(|s| s.as_str().to_string()).unwrap_or_default(),
        pair.strength()
            .map(|s| s.as_str().to_string())
            .unwrap_or_default(),
        pair.observations.to_string(),
    ]
}

/// Writes profiling artifacts into one output directory.
#[derive(Debug, Clone)]
pub struct ProfileEmitter {
    output_dir: PathBuf,
}

impl ProfileEmitter {
    /// Creates an emitter targeting `output_dir` (created if absent).
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Writes every artifact and returns the written paths in write order.
    pub fn emit(
        &self,
        table: &UnifiedTable,
        report: &ProfileReport,
        diagnostics: &Diagnostics,
    ) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| SurveyorError::io("create output directory", &self.output_dir, e))?;

        let mut written = vec![
            self.write_combined(table)?,
            self.write_sources(table)?,
            self.write_missingness(report)?,
            self.write_column_profiles(report)?,
            self.write_duplicates(table, report)?,
            self.write_outliers(table, report)?,
            self.write_outlier_summary(report)?,
            self.write_correlation_matrix(report)?,
            self.write_pairs(CORRELATION_PAIRS_FILE, &report.correlation.pairs)?,
            self.write_pairs(STRONG_CORRELATIONS_FILE, &report.correlation.strong)?,
            self.write_frequencies(report)?,
            self.write_grouped(report)?,
        ];

        let drivers_path = self.output_dir.join(TARGET_DRIVERS_FILE);
        if report.correlation.drivers.is_some() {
            written.push(self.write_drivers(report)?);
        } else if drivers_path.exists() {
            // Left over from an earlier run with a target configured
            std::fs::remove_file(&drivers_path)
                .map_err(|e| SurveyorError::io("remove stale", &drivers_path, e))?;
        }

        written.push(self.write_diagnostics(diagnostics)?);

        tracing::info!(
            "Wrote {} artifacts to {}",
            written.len(),
            self.output_dir.display()
        );
        Ok(written)
    }

    fn write_table<I>(&self, file: &str, header: &[&str], rows: I) -> Result<PathBuf>
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        let path = self.output_dir.join(file);
        let context = || format!("Failed to write {}", path.display());

        let mut writer =
            csv::Writer::from_path(&path).map_err(|e| SurveyorError::csv(context(), e))?;
        writer
            .write_record(header)
            .map_err(|e| SurveyorError::csv(context(), e))?;
        let mut count = 0usize;
        for row in rows {
            writer
                .write_record(&row)
                .map_err(|e| SurveyorError::csv(context(), e))?;
            count += 1;
        }
        writer
            .flush()
            .map_err(|e| SurveyorError::io("flush", &path, e))?;

        tracing::debug!("Wrote {} rows to {}", count, path.display());
        Ok(path)
    }

    fn write_combined(&self, table: &UnifiedTable) -> Result<PathBuf> {
        let mut header = RESERVED_COLUMNS.to_vec();
        header.extend(table.columns().iter().map(String::as_str));

        let rows = table.rows().iter().enumerate().map(|(row_id, cells)| {
            let source = table.source_of(row_id);
            let mut record = vec![
                row_id.to_string(),
                source.map(|s| s.source.clone()).unwrap_or_default(),
                source.map(|s| s.batch.clone()).unwrap_or_default(),
                table.version_of(row_id).as_str().to_string(),
            ];
            record.extend(cells.iter().map(|c| c.output_text().to_string()));
            record
        });

        self.write_table(COMBINED_FILE, &header, rows)
    }

    fn write_sources(&self, table: &UnifiedTable) -> Result<PathBuf> {
        let rows = table.sources().iter().map(|s| {
            vec![
                s.source.clone(),
                s.batch.clone(),
                s.schema_version.as_str().to_string(),
                s.columns.len().to_string(),
                s.row_count.to_string(),
            ]
        });
        self.write_table(
            SOURCES_FILE,
            &["source", "batch", "schema_version", "column_count", "row_count"],
            rows,
        )
    }

    fn write_missingness(&self, report: &ProfileReport) -> Result<PathBuf> {
        let rows = report.columns.iter().map(|p| {
            let m = &p.missingness;
            vec![
                p.name.clone(),
                p.kind.as_str().to_string(),
                m.non_missing.to_string(),
                m.missing.to_string(),
                num(m.missing_pct),
                m.tier.as_str().to_string(),
                m.pattern.as_str().to_string(),
                m.pattern_basis.as_str().to_string(),
                m.sibling.clone().unwrap_or_default(),
            ]
        });
        self.write_table(
            MISSINGNESS_FILE,
            &[
                "column",
                "kind",
                "non_missing",
                "missing",
                "missing_pct",
                "tier",
                "pattern",
                "pattern_basis",
                "sibling",
            ],
            rows,
        )
    }

    fn write_column_profiles(&self, report: &ProfileReport) -> Result<PathBuf> {
        let rows = report.columns.iter().map(|p| {
            let n = p.numeric.as_ref();
            let c = p.categorical.as_ref();
            vec![
                p.name.clone(),
                p.kind.as_str().to_string(),
                if p.kind_declared { "declared" } else { "inferred" }.to_string(),
                p.missingness.non_missing.to_string(),
                p.missingness.missing.to_string(),
                p.non_numeric.to_string(),
                n.map(|s| s.count.to_string()).unwrap_or_default(),
                opt_num(n.map(|s| s.mean)),
                opt_num(n.map(|s| s.median)),
                opt_num(n.and_then(|s| s.std)),
                opt_num(n.map(|s| s.q1)),
                opt_num(n.map(|s| s.q3)),
                opt_num(n.map(|s| s.iqr)),
                opt_num(n.map(|s| s.min)),
                opt_num(n.map(|s| s.max)),
                opt_num(n.and_then(|s| s.cv_pct)),
                c.map(|s| s.distinct.to_string()).unwrap_or_default(),
                c.and_then(|s| s.most_common.clone()).unwrap_or_default(),
                c.map(|s| s.most_common_count.to_string())
                    .unwrap_or_default(),
            ]
        });
        self.write_table(
            COLUMN_PROFILES_FILE,
            &[
                "column",
                "kind",
                "kind_source",
                "non_missing",
                "missing",
                "non_numeric",
                "count",
                "mean",
                "median",
                "std",
                "q1",
                "q3",
                "iqr",
                "min",
                "max",
                "cv_pct",
                "distinct",
                "most_common",
                "most_common_count",
            ],
            rows,
        )
    }

    fn write_duplicates(&self, table: &UnifiedTable, report: &ProfileReport) -> Result<PathBuf> {
        let groups = report
            .full_row_duplicates
            .iter()
            .enumerate()
            .chain(report.key_duplicates.iter().flatten().enumerate());

        let mut rows = Vec::new();
        for (idx, group) in groups {
            let key_values = key_values_text(group)?;
            for &row_id in &group.rows {
                rows.push(vec![
                    (idx + 1).to_string(),
                    group.mode.as_str().to_string(),
                    group.size().to_string(),
                    row_id.to_string(),
                    table
                        .source_of(row_id)
                        .map(|s| s.source.clone())
                        .unwrap_or_default(),
                    key_values.clone(),
                ]);
            }
        }

        self.write_table(
            DUPLICATES_FILE,
            &["group_id", "key_mode", "group_size", "row_id", "source", "key_values"],
            rows,
        )
    }

    fn write_outliers(&self, table: &UnifiedTable, report: &ProfileReport) -> Result<PathBuf> {
        let rows = report.outliers.iter().map(|o| {
            vec![
                o.row.to_string(),
                table
                    .source_of(o.row)
                    .map(|s| s.source.clone())
                    .unwrap_or_default(),
                o.column.clone(),
                num(o.value),
                o.bound.as_str().to_string(),
                num(o.bound_value),
                num(o.distance),
            ]
        });
        self.write_table(
            OUTLIERS_FILE,
            &["row_id", "source", "column", "value", "bound", "bound_value", "distance"],
            rows,
        )
    }

    fn write_outlier_summary(&self, report: &ProfileReport) -> Result<PathBuf> {
        let rows = report.outlier_summaries.iter().map(|s| {
            vec![
                s.column.clone(),
                s.observations.to_string(),
                s.outlier_count.to_string(),
                num(s.outlier_pct),
                num(s.lower_bound),
                num(s.upper_bound),
                num(s.q1),
                num(s.median),
                num(s.q3),
                num(s.min),
                num(s.max),
            ]
        });
        self.write_table(
            OUTLIER_SUMMARY_FILE,
            &[
                "column",
                "observations",
                "outlier_count",
                "outlier_pct",
                "lower_bound",
                "upper_bound",
                "q1",
                "median",
                "q3",
                "min",
                "max",
            ],
            rows,
        )
    }

    fn write_correlation_matrix(&self, report: &ProfileReport) -> Result<PathBuf> {
        let matrix = &report.correlation.matrix;
        let mut header = vec!["column"];
        header.extend(matrix.columns.iter().map(String::as_str));

        let rows = matrix.columns.iter().zip(&matrix.values).map(|(name, values)| {
            let mut record = vec![name.clone()];
            record.extend(values.iter().map(|v| opt_num(*v)));
            record
        });
        self.write_table(CORRELATION_MATRIX_FILE, &header, rows)
    }

    fn write_pairs(&self, file: &str, pairs: &[CorrelationPair]) -> Result<PathBuf> {
        self.write_table(file, &PAIR_HEADER, pairs.iter().map(pair_fields))
    }

    fn write_drivers(&self, report: &ProfileReport) -> Result<PathBuf> {
        let drivers = report.correlation.drivers.iter().flatten();
        let rows = drivers.map(|d| {
            let mut record = vec![d.rank.to_string()];
            record.extend(pair_fields(&d.pair));
            record
        });
        let mut header = vec!["rank"];
        header.extend(["target", "column"]);
        header.extend(&PAIR_HEADER[2..]);
        self.write_table(TARGET_DRIVERS_FILE, &header, rows)
    }

    fn write_frequencies(&self, report: &ProfileReport) -> Result<PathBuf> {
        let rows = report.frequencies.iter().map(|f| {
            vec![
                f.column.clone(),
                f.value.clone(),
                f.count.to_string(),
                num(f.pct),
                f.rank.to_string(),
            ]
        });
        self.write_table(
            CATEGORICAL_FREQUENCIES_FILE,
            &["column", "value", "count", "pct", "rank"],
            rows,
        )
    }

    fn write_grouped(&self, report: &ProfileReport) -> Result<PathBuf> {
        let rows = report.grouped.iter().map(|g| {
            vec![
                g.group_column.clone(),
                g.group_value.clone(),
                g.value_column.clone(),
                g.count.to_string(),
                num(g.mean),
                num(g.median),
                opt_num(g.std),
                num(g.min),
                num(g.max),
            ]
        });
        self.write_table(
            GROUPED_STATS_FILE,
            &[
                "group_column",
                "group_value",
                "value_column",
                "count",
                "mean",
                "median",
                "std",
                "min",
                "max",
            ],
            rows,
        )
    }

    fn write_diagnostics(&self, diagnostics: &Diagnostics) -> Result<PathBuf> {
        let path = self.output_dir.join(DIAGNOSTICS_FILE);
        let mut json = serde_json::to_string_pretty(diagnostics)
            .map_err(|e| SurveyorError::serialization("Failed to serialize diagnostics", e))?;
        json.push('\n');
        std::fs::write(&path, json).map_err(|e| SurveyorError::io("write", &path, e))?;
        Ok(path)
    }
}

/// Key values as a JSON array; missing values become `null`.
fn key_values_text(group: &DuplicateGroup) -> Result<String> {
    serde_json::to_string(&group.key_values)
        .map_err(|e| SurveyorError::serialization("Failed to serialize duplicate key", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Cell, SchemaVersion, SourceTable};
    use crate::profile::ProfileAnalyzer;
    use crate::ProfileConfig;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn table() -> UnifiedTable {
        let columns: Vec<String> = ["Lab No", "pH"].iter().map(|c| (*c).to_string()).collect();
        let rows: Vec<Vec<Cell>> = [("1", "6.5"), ("2", "6.8"), ("2", "6.8"), ("4", "7.0")]
            .iter()
            .map(|(a, b)| vec![Cell::Value((*a).to_string()), Cell::Value((*b).to_string())])
            .chain(std::iter::once(vec![
                Cell::Value("5".to_string()),
                Cell::Absent,
            ]))
            .collect();
        UnifiedTable::from_parts(
            columns.clone(),
            rows,
            vec![0, 0, 0, 0, 1],
            vec![
                SourceTable {
                    source: "batch_1/a.csv".to_string(),
                    batch: "batch_1".to_string(),
                    columns: columns.clone(),
                    row_count: 4,
                    schema_version: SchemaVersion::V1,
                },
                SourceTable {
                    source: "b.csv".to_string(),
                    batch: "input".to_string(),
                    columns: vec!["Lab No".to_string()],
                    row_count: 1,
                    schema_version: SchemaVersion::Unknown,
                },
            ],
        )
    }

    fn diagnostics() -> Diagnostics {
        Diagnostics {
            files_discovered: 2,
            files_loaded: 2,
            load_failures: Vec::new(),
            rows: 5,
            columns: 2,
            schema_versions: BTreeMap::new(),
            full_row_duplicate_groups: 1,
            key_duplicate_groups: None,
            outlier_records: 0,
            correlated_columns: 2,
            insufficient_data: Vec::new(),
        }
    }

    #[test]
    fn test_emit_writes_expected_files() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("profile");
        let table = table();
        let report = ProfileAnalyzer::with_defaults().analyze(&table).unwrap();

        let written = ProfileEmitter::new(&out)
            .emit(&table, &report, &diagnostics())
            .unwrap();

        assert_eq!(written.len(), 13);
        assert!(!out.join(TARGET_DRIVERS_FILE).exists());

        let combined = std::fs::read_to_string(out.join(COMBINED_FILE)).unwrap();
        let mut lines = combined.lines();
        assert_eq!(lines.next(), Some("_row_id,_source,_batch,_schema_version,Lab No,pH"));
        assert_eq!(lines.next(), Some("0,batch_1/a.csv,batch_1,v1,1,6.5"));
        assert_eq!(combined.lines().last(), Some("4,b.csv,input,unknown,5,"));

        let duplicates = std::fs::read_to_string(out.join(DUPLICATES_FILE)).unwrap();
        assert!(duplicates.contains("1,full_row,2,1,batch_1/a.csv,\"[\"\"2\"\",\"\"6.8\"\"]\""));

        // Every column is numeric, so the frequency table is header-only
        let frequencies =
            std::fs::read_to_string(out.join(CATEGORICAL_FREQUENCIES_FILE)).unwrap();
        assert_eq!(frequencies, "column,value,count,pct,rank\n");
    }

    #[test]
    fn test_emit_frequencies_and_grouped_stats() {
        let dir = TempDir::new().unwrap();
        let table = table();
        let config = ProfileConfig::new()
            .with_column_type("Lab No", crate::profile::ColumnKind::Categorical)
            .with_group_by(crate::GroupBySpec::new("Lab No", ["pH"]))
            .with_frequency_top_n(2);
        let report = ProfileAnalyzer::new(config).analyze(&table).unwrap();
        ProfileEmitter::new(dir.path())
            .emit(&table, &report, &diagnostics())
            .unwrap();

        let frequencies =
            std::fs::read_to_string(dir.path().join(CATEGORICAL_FREQUENCIES_FILE)).unwrap();
        let lines: Vec<&str> = frequencies.lines().collect();
        assert_eq!(
            lines,
            [
                "column,value,count,pct,rank",
                "Lab No,2,2,40,1",
                "Lab No,1,1,20,2",
            ]
        );

        let grouped = std::fs::read_to_string(dir.path().join(GROUPED_STATS_FILE)).unwrap();
        let lines: Vec<&str> = grouped.lines().collect();
        assert_eq!(
            lines,
            [
                "group_column,group_value,value_column,count,mean,median,std,min,max",
                "Lab No,4,pH,1,7,7,,7,7",
                "Lab No,2,pH,2,6.8,6.8,0,6.8,6.8",
                "Lab No,1,pH,1,6.5,6.5,,6.5,6.5",
            ]
        );
    }

    #[test]
    fn test_emit_is_byte_identical_on_rerun() {
        let dir = TempDir::new().unwrap();
        let table = table();
        let config = ProfileConfig::new().with_target_column("pH");
        let report = ProfileAnalyzer::new(config).analyze(&table).unwrap();
        let emitter = ProfileEmitter::new(dir.path());

        let first: Vec<Vec<u8>> = emitter
            .emit(&table, &report, &diagnostics())
            .unwrap()
            .iter()
            .map(|p| std::fs::read(p).unwrap())
            .collect();
        let second: Vec<Vec<u8>> = emitter
            .emit(&table, &report, &diagnostics())
            .unwrap()
            .iter()
            .map(|p| std::fs::read(p).unwrap())
            .collect();

        assert_eq!(first.len(), 14);
        assert_eq!(first, second);
    }

    #[test]
    fn test_undefined_r_written_empty() {
        let pair = CorrelationPair {
            column_a: "A".to_string(),
            column_b: "B".to_string(),
            r: None,
            observations: 1,
        };
        assert_eq!(pair_fields(&pair), vec!["A", "B", "", "", "", "", "1"]);
    }
}
