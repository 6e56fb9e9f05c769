use crate::utils::error::{Result, SyncError};
use chrono::{Days, NaiveDate};

/// Last day of an iteration. The start day counts as day one.
pub fn finish_date_of(start: NaiveDate, length: u32) -> NaiveDate {
    start + Days::new(u64::from(length.saturating_sub(1)))
}

pub fn next_start_date(prior_finish: NaiveDate) -> NaiveDate {
    prior_finish + Days::new(1)
}

pub fn iteration_name(prefix: &str, sequence_number: u32) -> String {
    format!("{} {}", prefix, sequence_number)
}

/// Sequence number encoded in `name`, e.g. `Sprint 12` -> 12.
pub fn sequence_number_of(name: &str, prefix: &str) -> Result<u32> {
    name.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix(' '))
        .and_then(|suffix| suffix.parse::<u32>().ok())
        .ok_or_else(|| SyncError::MalformedName {
            name: name.to_string(),
            prefix: prefix.to_string(),
        })
}

pub fn next_sequence_number(prior_name: &str, prefix: &str) -> Result<u32> {
    Ok(sequence_number_of(prior_name, prefix)? + 1)
}
