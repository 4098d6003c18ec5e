//! Verbatim copy of static files and directories.
//!
//! Each configured entry is a path relative to the content root. Files are
//! copied to the same relative path under the output; directories are copied
//! recursively. Entries that don't exist are reported, not fatal: most sites
//! only have some of the stock list.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum PassthroughError {
    #[error("cannot copy {} to {}: {source}", from.display(), to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot walk {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },
}

/// What one passthrough run did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassthroughReport {
    /// Configured entries that were copied, with the number of files each.
    pub copied: Vec<(String, usize)>,
    /// Configured entries absent from the content root.
    pub missing: Vec<String>,
}

impl PassthroughReport {
    pub fn file_count(&self) -> usize {
        self.copied.iter().map(|(_, n)| n).sum()
    }
}

pub fn copy_passthrough(
    source: &Path,
    output: &Path,
    entries: &[String],
) -> Result<PassthroughReport, PassthroughError> {
    let mut report = PassthroughReport::default();
    for entry in entries {
        let relative = entry.trim_matches('/');
        let from = source.join(relative);
        let to = output.join(relative);
        if from.is_file() {
            copy_file(&from, &to)?;
            report.copied.push((entry.clone(), 1));
        } else if from.is_dir() {
            let count = copy_dir(&from, &to)?;
            report.copied.push((entry.clone(), count));
        } else {
            report.missing.push(entry.clone());
        }
    }
    Ok(report)
}

/// Copy every regular file under `from` into `to`. Returns the file count.
fn copy_dir(from: &Path, to: &Path) -> Result<usize, PassthroughError> {
    let mut count = 0;
    for entry in WalkDir::new(from).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|source| PassthroughError::Walk {
            path: from.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(from).unwrap_or(entry.path());
        copy_file(entry.path(), &to.join(relative))?;
        count += 1;
    }
    Ok(count)
}

fn copy_file(from: &Path, to: &Path) -> Result<(), PassthroughError> {
    let copy_err = |source| PassthroughError::Copy {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(copy_err)?;
    }
    fs::copy(from, to).map_err(copy_err)?;
    Ok(())
}
