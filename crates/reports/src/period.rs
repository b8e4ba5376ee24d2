use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult};

pub(crate) const MIN_YEAR: i32 = 1970;
pub(crate) const MAX_YEAR: i32 = 9999;

/// Optional year/month filter. A month without a year is rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

impl Period {
    pub fn all_time() -> Self {
        Self::default()
    }

    pub fn new(year: Option<i32>, month: Option<u32>) -> DomainResult<Self> {
        if let Some(year) = year {
            check_year(year)?;
        }
        if let Some(month) = month {
            check_month(month)?;
            if year.is_none() {
                return Err(DomainError::validation("month filter requires a year"));
            }
        }
        Ok(Self { year, month })
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.year.is_none_or(|y| at.year() == y) && self.month.is_none_or(|m| at.month() == m)
    }
}

pub(crate) fn check_year(year: i32) -> DomainResult<()> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(DomainError::validation(format!(
            "year must be between {MIN_YEAR} and {MAX_YEAR}"
        )));
    }
    Ok(())
}

pub(crate) fn check_month(month: u32) -> DomainResult<()> {
    if !(1..=12).contains(&month) {
        return Err(DomainError::validation("month must be between 1 and 12"));
    }
    Ok(())
}
