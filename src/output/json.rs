//! JSON result document
//!
//! The result file is rewritten once per run. The previous version, if any,
//! is moved aside to `<file>.<timestamp>.bak` first.

use crate::model::ProductRecord;
use crate::output::{OutputError, OutputResult};
use crate::url::TIMESTAMP_FORMAT;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes crawl results to a fixed JSON file
#[derive(Debug, Clone)]
pub struct JsonOutput {
    path: PathBuf,
}

impl JsonOutput {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Archives the existing file and writes `records` in its place
    ///
    /// # Returns
    ///
    /// * `Ok(Some(PathBuf))` - Where the previous file was archived
    /// * `Ok(None)` - There was no previous file
    /// * `Err(OutputError)` - Archiving or writing failed
    pub fn save(&self, records: &[ProductRecord]) -> OutputResult<Option<PathBuf>> {
        let archived = archive_file(&self.path)?;
        if let Some(archived) = &archived {
            tracing::info!("Archived previous output to {}", archived.display());
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = File::create(&self.path)?;
        let mut writer = BufWriter::new(file);
        write_pretty(&mut writer, records)?;
        writer.flush()?;

        tracing::info!(
            "Saved {} products to {}",
            records.len(),
            self.path.display()
        );
        Ok(archived)
    }

    /// Reads the current result file back
    pub fn load(&self) -> OutputResult<Option<Vec<ProductRecord>>> {
        load_products(&self.path)
    }
}

/// Serializes with four-space indentation, leaving non-ASCII text unescaped
fn write_pretty<W: Write, T: Serialize + ?Sized>(writer: W, value: &T) -> OutputResult<()> {
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(writer, formatter);
    value.serialize(&mut serializer)?;
    Ok(())
}

/// Reads a previously written result file
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_products(path: &Path) -> OutputResult<Option<Vec<ProductRecord>>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)?;
    let records = serde_json::from_str(&content)?;
    Ok(Some(records))
}

/// Moves `path` to `<path>.<timestamp>.bak` in the same directory
///
/// Returns the archive location, or None if `path` did not exist.
pub fn archive_file(path: &Path) -> OutputResult<Option<PathBuf>> {
    if !path.exists() {
        return Ok(None);
    }

    let file_name = path
        .file_name()
        .ok_or_else(|| OutputError::Write(format!("{} has no file name", path.display())))?
        .to_string_lossy();
    let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT);
    let archived = path.with_file_name(format!("{}.{}.bak", file_name, timestamp));

    fs::rename(path, &archived)?;
    Ok(Some(archived))
}
