pub mod normalizer;
pub mod validator;

pub use normalizer::{coerce_float, coerce_integer, coerce_text, FieldNormalizer};
pub use validator::{RecordValidator, RejectReason, ValidationReport, Verdict};

use crate::models::RawRecord;

/// Normalize then validate a batch of raw records.
pub fn clean_records<'a, I>(raws: I) -> ValidationReport
where
    I: IntoIterator<Item = &'a RawRecord>,
{
    let normalizer = FieldNormalizer::new();
    RecordValidator::new().validate_batch(raws.into_iter().map(|raw| normalizer.normalize(raw)))
}
