use crate::processors::clean_records;
use crate::readers::RecordSource;
use crate::storage::Store;
use chrono::{Duration, Local, NaiveDateTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Fetching,
    Normalizing,
    Loading,
    Done,
    Failed,
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SyncState::Fetching => "fetching",
            SyncState::Normalizing => "normalizing",
            SyncState::Loading => "loading",
            SyncState::Done => "done",
            SyncState::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone)]
pub struct SyncReport {
    pub state: SyncState,
    /// State the run was in when it failed.
    pub failed_in: Option<SyncState>,
    pub window_start: NaiveDateTime,
    pub fetched: usize,
    pub kept: usize,
    pub rejected: usize,
    pub written: usize,
    pub error: Option<String>,
}

impl SyncReport {
    fn new(window_start: NaiveDateTime) -> Self {
        Self {
            state: SyncState::Fetching,
            failed_in: None,
            window_start,
            fetched: 0,
            kept: 0,
            rejected: 0,
            written: 0,
            error: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.state == SyncState::Done
    }

    fn advance(&mut self, next: SyncState) {
        tracing::debug!("sync: {} -> {}", self.state, next);
        self.state = next;
    }

    fn fail(mut self, error: impl std::fmt::Display) -> Self {
        let message = error.to_string();
        tracing::error!("sync failed while {}: {}", self.state, message);
        self.failed_in = Some(self.state);
        self.state = SyncState::Failed;
        self.error = Some(message);
        self
    }

    pub fn summary(&self) -> String {
        let mut summary = String::new();
        summary.push_str("=== Recent Sync Report ===\n");
        summary.push_str(&format!("Window Start: {}\n", self.window_start));
        summary.push_str(&format!("Fetched Rows: {}\n", self.fetched));
        summary.push_str(&format!("Valid Rows: {}\n", self.kept));
        summary.push_str(&format!("Rejected Rows: {}\n", self.rejected));
        summary.push_str(&format!("Rows Written: {}\n", self.written));
        match (&self.failed_in, &self.error) {
            (Some(stage), Some(error)) => {
                summary.push_str(&format!("Result: failed while {} ({})\n", stage, error))
            }
            _ => summary.push_str(&format!("Result: {}\n", self.state)),
        }
        summary
    }
}

/// Polls the trailing window of the live API and upserts it into the recent table.
pub struct IncrementalLoader<S> {
    source: S,
    lookback: Duration,
}

impl<S: RecordSource> IncrementalLoader<S> {
    pub fn new(source: S, lookback_hours: u32) -> Self {
        Self {
            source,
            lookback: Duration::hours(i64::from(lookback_hours)),
        }
    }

    pub async fn run(&self, store: &mut Store) -> SyncReport {
        self.run_at(store, Local::now().naive_local()).await
    }

    /// Run one sync with an explicit notion of "now".
    ///
    /// Never returns an error: failures are reported through `SyncReport::state`.
    pub async fn run_at(&self, store: &mut Store, now: NaiveDateTime) -> SyncReport {
        let mut report = SyncReport::new(now - self.lookback);

        let raws = match self.source.fetch_since(report.window_start).await {
            Ok(raws) => raws,
            Err(e) => return report.fail(e),
        };
        report.fetched = raws.len();
        report.advance(SyncState::Normalizing);

        let cleaned = clean_records(&raws);
        report.kept = cleaned.kept();
        report.rejected = cleaned.rejected;
        tracing::info!(
            "{} of {} fetched rows are valid ({} rejected)",
            report.kept,
            report.fetched,
            report.rejected
        );

        if cleaned.records.is_empty() {
            report.advance(SyncState::Done);
            return report;
        }

        report.advance(SyncState::Loading);
        match store.replace_recent(&cleaned.records) {
            Ok(written) => report.written = written,
            Err(e) => return report.fail(e),
        }

        report.advance(SyncState::Done);
        tracing::info!("Synced {} rows into the recent table", report.written);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ProcessingError, Result};
    use crate::models::RawRecord;
    use crate::storage::Table;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::Mutex;

    struct FakeSource {
        rows: Vec<RawRecord>,
        requested: Mutex<Vec<NaiveDateTime>>,
    }

    impl FakeSource {
        fn new(rows: Vec<RawRecord>) -> Self {
            Self {
                rows,
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl RecordSource for FakeSource {
        async fn fetch_since(&self, since: NaiveDateTime) -> Result<Vec<RawRecord>> {
            self.requested.lock().unwrap().push(since);
            Ok(self.rows.clone())
        }
    }

    struct DownSource;

    #[async_trait]
    impl RecordSource for DownSource {
        async fn fetch_since(&self, _since: NaiveDateTime) -> Result<Vec<RawRecord>> {
            Err(ProcessingError::Transport {
                status: 503,
                body: "maintenance".to_string(),
            })
        }
    }

    fn row(site: &str, ts: &str, aqi: &str) -> RawRecord {
        [("siteid", site), ("sitename", "站"), ("county", "臺中市"), ("aqi", aqi), ("datacreationdate", ts)]
            .into_iter()
            .collect()
    }

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 2)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn test_window_start_uses_lookback() {
        let source = FakeSource::new(vec![]);
        let loader = IncrementalLoader::new(source, 25);
        let mut store = Store::open_in_memory().unwrap();

        let report = loader.run_at(&mut store, noon()).await;

        let expected = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(11, 0, 0)
            .unwrap();
        assert_eq!(report.window_start, expected);
        assert_eq!(loader.source.requested.lock().unwrap()[0], expected);
    }

    #[tokio::test]
    async fn test_repeated_runs_are_idempotent() {
        let source = FakeSource::new(vec![
            row("1", "2024-05-02 10:00", "30"),
            row("1", "2024-05-02 11:00", "35"),
            row("2", "2024-05-02 11:00", "nan"),
            row("", "2024-05-02 11:00", "40"),
        ]);
        let loader = IncrementalLoader::new(source, 25);
        let mut store = Store::open_in_memory().unwrap();

        let first = loader.run_at(&mut store, noon()).await;
        let count_after_first = store.count_rows(Table::Recent).unwrap();
        let second = loader.run_at(&mut store, noon()).await;

        assert!(first.succeeded());
        assert!(second.succeeded());
        assert_eq!(first.fetched, 4);
        assert_eq!(first.kept, 3);
        assert_eq!(first.rejected, 1);
        assert_eq!(first.written, 3);
        assert_eq!(count_after_first, 3);
        assert_eq!(store.count_rows(Table::Recent).unwrap(), 3);
    }

    #[tokio::test]
    async fn test_no_valid_rows_is_success_without_writes() {
        let loader = IncrementalLoader::new(FakeSource::new(vec![row("nan", "", "1")]), 25);
        let mut store = Store::open_in_memory().unwrap();

        let report = loader.run_at(&mut store, noon()).await;

        assert_eq!(report.state, SyncState::Done);
        assert_eq!(report.written, 0);
        assert_eq!(report.rejected, 1);
        assert_eq!(store.count_rows(Table::Recent).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_fetch_failure_reports_failed() {
        let loader = IncrementalLoader::new(DownSource, 25);
        let mut store = Store::open_in_memory().unwrap();

        let report = loader.run_at(&mut store, noon()).await;

        assert_eq!(report.state, SyncState::Failed);
        assert_eq!(report.failed_in, Some(SyncState::Fetching));
        assert!(report.error.as_deref().unwrap().contains("503"));
        assert!(report.summary().contains("failed while fetching"));
    }

    #[tokio::test]
    async fn test_load_failure_reports_failed() {
        let loader = IncrementalLoader::new(
            FakeSource::new(vec![row("1", "2024-05-02 10:00", "30"), row("666", "2024-05-02 10:00", "30")]),
            25,
        );
        let mut store = Store::open_in_memory().unwrap();
        store
            .connection()
            .execute_batch(
                "CREATE TRIGGER reject_site_666 BEFORE INSERT ON air_quality_records
                 WHEN NEW.SiteId = 666 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .unwrap();

        let report = loader.run_at(&mut store, noon()).await;

        assert_eq!(report.state, SyncState::Failed);
        assert_eq!(report.failed_in, Some(SyncState::Loading));
        assert_eq!(store.count_rows(Table::Recent).unwrap(), 0);
    }
}
