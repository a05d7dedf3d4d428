use crate::models::{CanonicalRecord, ValidRecord};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RejectReason {
    MissingSiteId,
    MissingDataCreationDate,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::MissingSiteId => write!(f, "missing SiteId"),
            RejectReason::MissingDataCreationDate => write!(f, "missing DataCreationDate"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Keep(ValidRecord),
    Reject(RejectReason),
}

/// Outcome of validating a batch. Rejected records are counted, not kept.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub records: Vec<ValidRecord>,
    pub rejected: usize,
    pub reject_reasons: BTreeMap<RejectReason, usize>,
}

impl ValidationReport {
    pub fn kept(&self) -> usize {
        self.records.len()
    }

    pub fn total(&self) -> usize {
        self.kept() + self.rejected
    }
}

pub struct RecordValidator;

impl RecordValidator {
    pub fn new() -> Self {
        Self
    }

    /// A record is kept iff it carries both identity fields.
    pub fn validate(&self, record: CanonicalRecord) -> Verdict {
        let Some(site_id) = record.site_id else {
            return Verdict::Reject(RejectReason::MissingSiteId);
        };
        let data_creation_date = match record.data_creation_date {
            Some(ts) if !ts.trim().is_empty() => ts,
            _ => return Verdict::Reject(RejectReason::MissingDataCreationDate),
        };

        Verdict::Keep(ValidRecord {
            site_id,
            site_name: record.site_name,
            county: record.county,
            aqi: record.aqi,
            status: record.status,
            data_creation_date,
            latitude: record.latitude,
            longitude: record.longitude,
        })
    }

    pub fn validate_batch<I>(&self, records: I) -> ValidationReport
    where
        I: IntoIterator<Item = CanonicalRecord>,
    {
        let mut report = ValidationReport::default();

        for record in records {
            match self.validate(record) {
                Verdict::Keep(valid) => report.records.push(valid),
                Verdict::Reject(reason) => {
                    report.rejected += 1;
                    *report.reject_reasons.entry(reason).or_default() += 1;
                }
            }
        }

        report
    }
}

impl Default for RecordValidator {
    fn default() -> Self {
        Self::new()
    }
}
