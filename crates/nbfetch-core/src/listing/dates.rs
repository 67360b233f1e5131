use anyhow::{bail, Context, Result};
use chrono::NaiveDate;

const DATE_FORMAT: &str = "%Y%m%d";

/// Every day from `start` to `end` inclusive, as `YYYYMMDD`.
pub fn date_range(start: &str, end: &str) -> Result<Vec<String>> {
    let first = NaiveDate::parse_from_str(start, DATE_FORMAT)
        .with_context(|| format!("invalid start date {:?}, expected YYYYMMDD", start))?;
    let last = NaiveDate::parse_from_str(end, DATE_FORMAT)
        .with_context(|| format!("invalid end date {:?}, expected YYYYMMDD", end))?;
    if first > last {
        bail!("start date {} is after end date {}", start, end);
    }
    Ok(first
        .iter_days()
        .take_while(|d| *d <= last)
        .map(|d| d.format(DATE_FORMAT).to_string())
        .collect())
}

/// `{base}{YYYYMM}/{YYYYMMDD}/`. `base` must end with `/`.
pub fn date_url(base: &str, date: &str) -> String {
    let month = date.get(..6).unwrap_or(date);
    format!("{}{}/{}/", base, month, date)
}
