//! Period tokens and extraction windows
//!
//! DHIS2 addresses data by period tokens (`201001`, `2010Q1`, `2010`).
//! The scheduler never computes periods on the fly: the full time range is
//! partitioned up front into an ordered sequence of [`PeriodWindow`]s, each
//! a comma-joined batch of tokens sent in a single `dataValueSets` request.
//! Window order matters only for reproducibility of output ordering.

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Period granularity supported by the remote source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PeriodGranularity {
    /// Monthly periods, e.g. `201001`
    Monthly,
    /// Quarterly periods, e.g. `2010Q1`
    #[default]
    Quarterly,
    /// Yearly periods, e.g. `2010`
    Yearly,
}

/// A batch of period tokens sent together in one data request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodWindow(String);

impl PeriodWindow {
    /// Builds a window from an ordered list of period tokens
    pub fn new(tokens: &[String]) -> Self {
        Self(tokens.join(","))
    }

    /// Returns the comma-joined period expression
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeriodWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pre-computed partition of the overall time range
///
/// # Examples
///
/// ```
/// use harvest::domain::period::{PeriodGranularity, PeriodPlan};
///
/// let plan = PeriodPlan::new("2010-01", "2010-12", PeriodGranularity::Quarterly)
///     .expect("valid range");
/// let windows = plan.windows(2);
/// assert_eq!(windows.len(), 2);
/// assert_eq!(windows[0].as_str(), "2010Q1,2010Q2");
/// ```
#[derive(Debug, Clone)]
pub struct PeriodPlan {
    tokens: Vec<String>,
}

impl PeriodPlan {
    /// Generates the ordered period token sequence for `[start, end]`
    ///
    /// `start` and `end` are inclusive month bounds in `YYYY-MM` format.
    pub fn new(start: &str, end: &str, granularity: PeriodGranularity) -> Result<Self, String> {
        let start = parse_month(start)?;
        let end = parse_month(end)?;
        if end < start {
            return Err(format!(
                "Period range end {} precedes start {}",
                end.format("%Y-%m"),
                start.format("%Y-%m")
            ));
        }

        let mut tokens = Vec::new();
        let mut cursor = start;
        while cursor <= end {
            let token = match granularity {
                PeriodGranularity::Monthly => format!("{}{:02}", cursor.year(), cursor.month()),
                PeriodGranularity::Quarterly => {
                    format!("{}Q{}", cursor.year(), (cursor.month() - 1) / 3 + 1)
                }
                PeriodGranularity::Yearly => cursor.year().to_string(),
            };
            // Coarser granularities emit one token per quarter/year, not per month
            if tokens.last() != Some(&token) {
                tokens.push(token);
            }
            cursor = cursor
                .checked_add_months(Months::new(1))
                .ok_or_else(|| "Period range overflow".to_string())?;
        }

        Ok(Self { tokens })
    }

    /// Number of period tokens in the plan
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns true if the plan contains no periods
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Partitions the token sequence into windows of at most
    /// `periods_per_window` tokens, preserving order
    pub fn windows(&self, periods_per_window: usize) -> Vec<PeriodWindow> {
        let chunk = periods_per_window.max(1);
        self.tokens
            .chunks(chunk)
            .map(PeriodWindow::new)
            .collect()
    }
}

fn parse_month(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d")
        .map_err(|e| format!("Invalid period bound '{s}', expected YYYY-MM: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_quarterly_tokens() {
        let plan = PeriodPlan::new("2010-01", "2010-12", PeriodGranularity::Quarterly).unwrap();
        let windows = plan.windows(1);
        let tokens: Vec<&str> = windows.iter().map(|w| w.as_str()).collect();
        assert_eq!(tokens, vec!["2010Q1", "2010Q2", "2010Q3", "2010Q4"]);
    }

    #[test]
    fn test_quarterly_partial_year() {
        // Mirrors a range ending mid-year: the last quarter is included
        let plan = PeriodPlan::new("2010-01", "2013-09", PeriodGranularity::Quarterly).unwrap();
        assert_eq!(plan.len(), 15);
        let windows = plan.windows(100);
        assert!(windows[0].as_str().starts_with("2010Q1"));
        assert!(windows[0].as_str().ends_with("2013Q3"));
    }

    #[test]
    fn test_monthly_tokens() {
        let plan = PeriodPlan::new("2010-11", "2011-02", PeriodGranularity::Monthly).unwrap();
        let windows = plan.windows(1);
        let tokens: Vec<&str> = windows.iter().map(|w| w.as_str()).collect();
        assert_eq!(tokens, vec!["201011", "201012", "201101", "201102"]);
    }

    #[test]
    fn test_yearly_tokens() {
        let plan = PeriodPlan::new("2010-06", "2012-02", PeriodGranularity::Yearly).unwrap();
        let windows = plan.windows(1);
        let tokens: Vec<&str> = windows.iter().map(|w| w.as_str()).collect();
        assert_eq!(tokens, vec!["2010", "2011", "2012"]);
    }

    #[test]
    fn test_window_chunking() {
        let plan = PeriodPlan::new("2010-01", "2011-12", PeriodGranularity::Quarterly).unwrap();
        let windows = plan.windows(3);
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[0].as_str(), "2010Q1,2010Q2,2010Q3");
        assert_eq!(windows[2].as_str(), "2011Q3,2011Q4");
    }

    #[test]
    fn test_zero_chunk_treated_as_one() {
        let plan = PeriodPlan::new("2010-01", "2010-06", PeriodGranularity::Quarterly).unwrap();
        assert_eq!(plan.windows(0).len(), 2);
    }

    #[test]
    fn test_inverted_range_rejected() {
        assert!(PeriodPlan::new("2012-01", "2010-01", PeriodGranularity::Monthly).is_err());
    }

    #[test_case("2010"; "missing month")]
    #[test_case("2010-13"; "month out of range")]
    #[test_case("abcd-01"; "non-numeric year")]
    fn test_invalid_bounds_rejected(bound: &str) {
        assert!(PeriodPlan::new(bound, "2011-01", PeriodGranularity::Monthly).is_err());
    }

    #[test]
    fn test_single_month_range() {
        let plan = PeriodPlan::new("2010-05", "2010-05", PeriodGranularity::Monthly).unwrap();
        assert_eq!(plan.windows(10).len(), 1);
        assert_eq!(plan.windows(10)[0].as_str(), "201005");
    }
}
