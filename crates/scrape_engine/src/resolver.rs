use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Reader};
use scrape_core::{ArtifactTally, JobHandle, JobResult, ResolveError};
use scrape_logging::{scrape_debug, scrape_info};

const NAME_COLUMN: &str = "Name";
const TITLE_COLUMN: &str = "Title";

/// Reads the worker's output artifact and reports totals from its rows.
#[derive(Debug, Clone)]
pub struct ArtifactResolver {
    path: PathBuf,
}

impl ArtifactResolver {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Totals for `handle`, read from the artifact on disk.
    ///
    /// An artifact last modified before the handle was launched belongs to an
    /// earlier run and counts as missing.
    pub fn resolve(&self, handle: JobHandle) -> Result<JobResult, ResolveError> {
        self.resolve_rows(handle, None)
    }

    /// Like [`resolve`](Self::resolve), counting at most `row_limit` data rows.
    pub fn resolve_rows(
        &self,
        handle: JobHandle,
        row_limit: Option<u32>,
    ) -> Result<JobResult, ResolveError> {
        let meta = match fs::metadata(&self.path) {
            Ok(meta) => meta,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(ResolveError::ArtifactMissing(self.path.clone()));
            }
            Err(err) => return Err(self.unreadable(err)),
        };
        if !meta.is_file() {
            return Err(self.unreadable("not a regular file"));
        }
        if let Ok(modified) = meta.modified() {
            if modified < handle.launched_at() {
                scrape_info!(
                    "Artifact {:?} predates {}; treating it as missing",
                    self.path,
                    handle
                );
                return Err(ResolveError::ArtifactMissing(self.path.clone()));
            }
        }

        let rows = match self.extension().as_deref() {
            Some("csv") => self.read_csv()?,
            Some("xlsx" | "xlsm" | "xlsb" | "xls" | "ods") => self.read_workbook()?,
            _ => return Err(self.unreadable("unsupported artifact format")),
        };
        let result = self.tally(rows, row_limit)?;
        scrape_debug!(
            "Resolved {}: total={} failed={}",
            handle,
            result.total_processed(),
            result.failed()
        );
        Ok(result)
    }

    fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
    }

    fn read_csv(&self) -> Result<Vec<Vec<String>>, ResolveError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)
            .map_err(|err| self.unreadable(err))?;
        reader
            .records()
            .map(|record| {
                record
                    .map(|r| r.iter().map(str::to_string).collect::<Vec<_>>())
                    .map_err(|err| self.unreadable(err))
            })
            .collect()
    }

    fn read_workbook(&self) -> Result<Vec<Vec<String>>, ResolveError> {
        let mut workbook = open_workbook_auto(&self.path).map_err(|err| self.unreadable(err))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| self.unreadable("workbook has no sheets"))?
            .map_err(|err| self.unreadable(err))?;
        Ok(range
            .rows()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect())
    }

    fn tally(
        &self,
        rows: Vec<Vec<String>>,
        row_limit: Option<u32>,
    ) -> Result<JobResult, ResolveError> {
        let mut rows = rows.into_iter();
        let header = rows
            .next()
            .ok_or_else(|| self.unreadable("artifact has no header row"))?;
        let name_at = column(&header, NAME_COLUMN)
            .ok_or_else(|| self.unreadable("missing Name column"))?;
        let title_at = column(&header, TITLE_COLUMN)
            .ok_or_else(|| self.unreadable("missing Title column"))?;

        let mut tally = ArtifactTally::new();
        for row in rows {
            if row_limit.is_some_and(|limit| tally.rows() >= limit) {
                break;
            }
            if row.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }
            let cell = |at: usize| row.get(at).map(String::as_str).unwrap_or("");
            tally.record(cell(name_at), cell(title_at));
        }
        Ok(tally.finish(self.path.clone()))
    }

    fn unreadable(&self, reason: impl ToString) -> ResolveError {
        ResolveError::ArtifactUnreadable {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }
}

fn column(header: &[String], name: &str) -> Option<usize> {
    header
        .iter()
        .position(|cell| cell.trim().trim_start_matches('\u{feff}').eq_ignore_ascii_case(name))
}
