use crate::error::{ProcessingError, Result};
use crate::processors::{clean_records, ValidationReport};
use crate::readers::snapshot_reader::{display_name, SnapshotReader};
use crate::storage::{Store, Table};
use crate::utils::constants::CONFIRMATION_WORD;
use crate::utils::ProgressReporter;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

/// Proof that an operator agreed to the destructive reload.
///
/// `HistoricalLoader::import` cannot be called without one.
#[derive(Debug)]
pub struct ImportConfirmation(());

impl ImportConfirmation {
    /// Confirmation given up front, e.g. by a `--yes` flag.
    pub fn assume_yes() -> Self {
        Self(())
    }

    /// Ask on `output` and read the answer from `input`; only `yes` confirms.
    pub fn prompt<R: BufRead, W: Write>(input: &mut R, output: &mut W, table: Table) -> Result<Self> {
        write!(
            output,
            "WARNING: table '{}' will be emptied and reloaded from the snapshot files.\n\
             Type '{}' to continue: ",
            table, CONFIRMATION_WORD
        )?;
        output.flush()?;

        let mut answer = String::new();
        input.read_line(&mut answer)?;
        if answer.trim().eq_ignore_ascii_case(CONFIRMATION_WORD) {
            Ok(Self(()))
        } else {
            Err(ProcessingError::Cancelled)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileCheck {
    pub file: String,
    pub valid: usize,
    pub invalid: usize,
    /// Set when the file could not be read or had an unexpected shape.
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CheckReport {
    pub files: Vec<FileCheck>,
    pub total_valid: usize,
    pub total_invalid: usize,
}

impl CheckReport {
    pub fn summary(&self) -> String {
        let mut summary = String::new();
        summary.push_str("=== Snapshot Check Report ===\n");
        for file in &self.files {
            match &file.error {
                Some(error) => summary.push_str(&format!("  {}: unreadable ({})\n", file.file, error)),
                None => summary.push_str(&format!(
                    "  {}: {} valid, {} invalid\n",
                    file.file, file.valid, file.invalid
                )),
            }
        }
        summary.push_str(&format!("Files: {}\n", self.files.len()));
        summary.push_str(&format!("Total Valid Records: {}\n", self.total_valid));
        summary.push_str(&format!("Total Invalid Records: {}\n", self.total_invalid));
        summary
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChunkOutcome {
    /// 1-based chunk number within its file.
    pub index: usize,
    pub rows: usize,
    /// Rows actually added; duplicates of existing identities are skipped.
    pub inserted: usize,
    pub error: Option<String>,
}

impl ChunkOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileImport {
    pub file: String,
    pub valid: usize,
    /// Rows in chunks that committed.
    pub attempted: usize,
    pub inserted: usize,
    pub chunks: Vec<ChunkOutcome>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuditOutcome {
    Consistent,
    /// Expected when duplicate identities were skipped.
    Mismatch { attempted: usize, actual: u64 },
    Unavailable(String),
}

#[derive(Debug, Clone)]
pub struct ImportReport {
    pub deleted: usize,
    pub files: Vec<FileImport>,
    pub total_attempted: usize,
    pub total_inserted: usize,
    pub failed_chunks: usize,
    pub audit: AuditOutcome,
}

impl ImportReport {
    pub fn summary(&self) -> String {
        let mut summary = String::new();
        summary.push_str("=== Historical Import Report ===\n");
        summary.push_str(&format!("Rows Deleted Before Import: {}\n", self.deleted));
        for file in &self.files {
            match &file.error {
                Some(error) => summary.push_str(&format!("  {}: skipped ({})\n", file.file, error)),
                None => summary.push_str(&format!(
                    "  {}: attempted {} / {} valid records, {} new\n",
                    file.file, file.attempted, file.valid, file.inserted
                )),
            }
        }
        summary.push_str(&format!("Total Attempted: {}\n", self.total_attempted));
        summary.push_str(&format!("Total Inserted: {}\n", self.total_inserted));
        summary.push_str(&format!("Failed Chunks: {}\n", self.failed_chunks));
        match &self.audit {
            AuditOutcome::Consistent => summary.push_str("Audit: table count matches attempted rows\n"),
            AuditOutcome::Mismatch { attempted, actual } => summary.push_str(&format!(
                "Audit: table holds {} rows but {} were attempted\n",
                actual, attempted
            )),
            AuditOutcome::Unavailable(error) => {
                summary.push_str(&format!("Audit: unavailable ({})\n", error))
            }
        }
        summary
    }
}

/// Two-phase loader for the historical snapshot directory.
pub struct HistoricalLoader {
    dir: PathBuf,
    chunk_size: usize,
    reader: SnapshotReader,
}

impl HistoricalLoader {
    pub fn new(dir: impl Into<PathBuf>, chunk_size: usize) -> Self {
        Self {
            dir: dir.into(),
            chunk_size: chunk_size.max(1),
            reader: SnapshotReader::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn snapshot_files(&self) -> Result<Vec<PathBuf>> {
        self.reader.list_files(&self.dir)
    }

    fn clean_file(&self, path: &Path) -> Result<ValidationReport> {
        let raws = self.reader.read_file(path)?;
        Ok(clean_records(&raws))
    }

    /// Dry run: count valid and invalid records per file. Touches no database.
    pub fn check(&self, progress: &ProgressReporter) -> Result<CheckReport> {
        let mut report = CheckReport::default();

        for path in self.snapshot_files()? {
            let file = display_name(&path);
            progress.set_message(&format!("Checking {}", file));

            let check = match self.clean_file(&path) {
                Ok(cleaned) => {
                    tracing::info!(
                        "{}: {} valid, {} invalid records",
                        file,
                        cleaned.kept(),
                        cleaned.rejected
                    );
                    FileCheck {
                        file,
                        valid: cleaned.kept(),
                        invalid: cleaned.rejected,
                        error: None,
                    }
                }
                Err(e) => {
                    tracing::error!("Failed to read {}: {}", file, e);
                    FileCheck {
                        file,
                        valid: 0,
                        invalid: 0,
                        error: Some(e.to_string()),
                    }
                }
            };

            report.total_valid += check.valid;
            report.total_invalid += check.invalid;
            report.files.push(check);
            progress.increment(1);
        }

        progress.finish_with_message("Check complete");
        Ok(report)
    }

    /// Destructive reload: empty the historical table, then append every snapshot file.
    ///
    /// Only a failure to list the directory or to empty the table is returned as an error;
    /// per-file and per-chunk failures are recorded in the report.
    pub fn import(
        &self,
        store: &mut Store,
        _confirmation: ImportConfirmation,
        progress: &ProgressReporter,
    ) -> Result<ImportReport> {
        let files = self.snapshot_files()?;

        tracing::info!("Emptying table '{}'", Table::Historical);
        let deleted = store.clear_historical().inspect_err(|e| {
            tracing::error!("Failed to empty '{}': {}", Table::Historical, e);
        })?;
        tracing::info!("Deleted {} rows", deleted);

        let file_reports = self.append_files(store, &files, progress);
        let total_attempted = file_reports.iter().map(|f| f.attempted).sum();
        let audit = audit(store, total_attempted);

        Ok(ImportReport {
            deleted,
            total_inserted: file_reports.iter().map(|f| f.inserted).sum(),
            failed_chunks: file_reports
                .iter()
                .flat_map(|f| &f.chunks)
                .filter(|c| !c.succeeded())
                .count(),
            files: file_reports,
            total_attempted,
            audit,
        })
    }

    /// Append snapshot files to the historical table without clearing it first.
    pub fn append_files(
        &self,
        store: &mut Store,
        files: &[PathBuf],
        progress: &ProgressReporter,
    ) -> Vec<FileImport> {
        let mut reports = Vec::with_capacity(files.len());

        for path in files {
            let file = display_name(path);
            progress.set_message(&format!("Importing {}", file));

            let report = match self.clean_file(path) {
                Ok(cleaned) => self.insert_chunks(store, &file, &cleaned),
                Err(e) => {
                    tracing::error!("Failed to read {}: {}", file, e);
                    FileImport {
                        file,
                        valid: 0,
                        attempted: 0,
                        inserted: 0,
                        chunks: Vec::new(),
                        error: Some(e.to_string()),
                    }
                }
            };

            if report.error.is_none() {
                tracing::info!(
                    "{}: attempted {} / {} records",
                    report.file,
                    report.attempted,
                    report.valid
                );
            }
            reports.push(report);
            progress.increment(1);
        }

        progress.finish_with_message("Import complete");
        reports
    }

    fn insert_chunks(&self, store: &mut Store, file: &str, cleaned: &ValidationReport) -> FileImport {
        let mut report = FileImport {
            file: file.to_string(),
            valid: cleaned.kept(),
            attempted: 0,
            inserted: 0,
            chunks: Vec::new(),
            error: None,
        };

        for (i, chunk) in cleaned.records.chunks(self.chunk_size).enumerate() {
            let outcome = match store.insert_historical_chunk(chunk) {
                Ok(inserted) => {
                    report.attempted += chunk.len();
                    report.inserted += inserted;
                    ChunkOutcome {
                        index: i + 1,
                        rows: chunk.len(),
                        inserted,
                        error: None,
                    }
                }
                Err(e) => {
                    tracing::error!("{}: chunk {} failed and was rolled back: {}", file, i + 1, e);
                    ChunkOutcome {
                        index: i + 1,
                        rows: chunk.len(),
                        inserted: 0,
                        error: Some(e.to_string()),
                    }
                }
            };
            report.chunks.push(outcome);
        }

        report
    }
}

/// Compare the table's row count against the rows this run attempted.
fn audit(store: &Store, attempted: usize) -> AuditOutcome {
    match store.count_rows(Table::Historical) {
        Ok(actual) if actual == attempted as u64 => {
            tracing::info!("Audit passed: '{}' holds {} rows", Table::Historical, actual);
            AuditOutcome::Consistent
        }
        Ok(actual) => {
            tracing::warn!(
                "Audit mismatch: '{}' holds {} rows but {} were attempted",
                Table::Historical,
                actual,
                attempted
            );
            AuditOutcome::Mismatch { attempted, actual }
        }
        Err(e) => {
            tracing::error!("Audit query failed: {}", e);
            AuditOutcome::Unavailable(e.to_string())
        }
    }
}
