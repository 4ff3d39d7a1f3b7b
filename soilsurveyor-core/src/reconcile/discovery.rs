//! Source file discovery for export directories.

use std::path::{Path, PathBuf};

use crate::error::{Result, SurveyorError};
use crate::models::LoadFailure;

/// Outcome of walking an input directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovered {
    /// CSV files, sorted by path
    pub files: Vec<PathBuf>,
    /// Sub-directories that could not be listed, sorted by source id
    pub unreadable: Vec<LoadFailure>,
}

/// Recursively lists all CSV files under `dir`.
///
/// Export batches arrive as sub-directories, so the walk descends into
/// every directory. Symbolic links are never followed: a linked directory
/// (`latest -> batch_3`, or a link back to the root) would otherwise load
/// the same files twice. A sub-directory that cannot be listed is recorded
/// in [`Discovered::unreadable`]; only an unreadable root is an error.
pub fn list_csv_files(dir: &Path) -> Result<Discovered> {
    if !dir.is_dir() {
        return Err(SurveyorError::configuration(format!(
            "Input directory does not exist: {}",
            dir.display()
        )));
    }

    let mut discovered = Discovered::default();
    let mut pending = vec![dir.to_path_buf()];
    let mut skipped_links = 0usize;

    while let Some(current) = pending.pop() {
        let entries = match std::fs::read_dir(&current) {
            Ok(entries) => entries,
            Err(e) if current.as_path() == dir => {
                return Err(SurveyorError::io("read directory", &current, e));
            }
            Err(e) => {
                record_unreadable(&mut discovered, dir, &current, &e);
                continue;
            }
        };

        for entry_result in entries {
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(e) => {
                    record_unreadable(&mut discovered, dir, &current, &e);
                    continue;
                }
            };
            let path = entry.path();

            // file_type() does not follow links
            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(e) => {
                    record_unreadable(&mut discovered, dir, &path, &e);
                    continue;
                }
            };

            if file_type.is_symlink() {
                tracing::warn!("Skipping symbolic link {}", path.display());
                skipped_links += 1;
            } else if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file() && has_csv_extension(&path) {
                discovered.files.push(path);
            }
        }
    }

    discovered.files.sort();
    discovered
        .unreadable
        .sort_by(|a, b| a.source.cmp(&b.source));
    tracing::debug!(
        "Discovered {} CSV files under {} ({} links skipped, {} unreadable directories)",
        discovered.files.len(),
        dir.display(),
        skipped_links,
        discovered.unreadable.len()
    );

    Ok(discovered)
}

fn record_unreadable(discovered: &mut Discovered, root: &Path, path: &Path, error: &std::io::Error) {
    tracing::warn!("Cannot read {}: {}", path.display(), error);
    let source = source_id(root, path);
    if discovered.unreadable.iter().any(|f| f.source == source) {
        return;
    }
    discovered.unreadable.push(LoadFailure {
        source,
        reason: format!("unreadable directory: {}", error),
    });
}

/// Checks for a `.csv` extension (case-insensitive).
fn has_csv_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

/// Identifier of a source relative to the input root, `/`-separated.
pub fn source_id(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Batch label: the name of the directory containing the file.
///
/// Files directly in the input root take the root directory's name.
pub fn batch_label(path: &Path) -> String {
    path.parent()
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
