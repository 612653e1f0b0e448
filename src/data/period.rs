//! Relative lookback tokens such as `3mo` or `1y`

use crate::error::{PotentialError, Result};
use crate::types::Timestamp;
use chrono::{Datelike, Duration, Months, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lookback window for a data request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Period {
    Days(u32),
    Weeks(u32),
    Months(u32),
    Years(u32),
    YearToDate,
    Max,
}

impl Period {
    /// Token form understood by market data services
    pub fn as_token(&self) -> String {
        match self {
            Period::Days(n) => format!("{n}d"),
            Period::Weeks(n) => format!("{n}wk"),
            Period::Months(n) => format!("{n}mo"),
            Period::Years(n) => format!("{n}y"),
            Period::YearToDate => "ytd".to_string(),
            Period::Max => "max".to_string(),
        }
    }

    /// Earliest timestamp covered when the window ends at `end`.
    ///
    /// `None` means unbounded.
    pub fn start_from(&self, end: Timestamp) -> Option<Timestamp> {
        match *self {
            Period::Days(n) => Some(end - Duration::days(n as i64)),
            Period::Weeks(n) => Some(end - Duration::weeks(n as i64)),
            Period::Months(n) => end.checked_sub_months(Months::new(n)),
            Period::Years(n) => end.checked_sub_months(Months::new(n.saturating_mul(12))),
            Period::YearToDate => Utc.with_ymd_and_hms(end.year(), 1, 1, 0, 0, 0).single(),
            Period::Max => None,
        }
    }
}

impl Default for Period {
    fn default() -> Self {
        Period::Months(3)
    }
}

impl FromStr for Period {
    type Err = PotentialError;

    fn from_str(s: &str) -> Result<Self> {
        let token = s.trim().to_ascii_lowercase();
        match token.as_str() {
            "ytd" => return Ok(Period::YearToDate),
            "max" => return Ok(Period::Max),
            _ => {}
        }

        let split = token
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| PotentialError::Parse(format!("Period without unit: {s}")))?;
        let (count, unit) = token.split_at(split);
        let count: u32 = count
            .parse()
            .map_err(|_| PotentialError::Parse(format!("Invalid period count: {s}")))?;
        if count == 0 {
            return Err(PotentialError::Parse(format!("Period must be positive: {s}")));
        }

        match unit {
            "d" => Ok(Period::Days(count)),
            "wk" => Ok(Period::Weeks(count)),
            "mo" => Ok(Period::Months(count)),
            "y" => Ok(Period::Years(count)),
            _ => Err(PotentialError::Parse(format!("Unknown period unit: {s}"))),
        }
    }
}

impl TryFrom<String> for Period {
    type Error = PotentialError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Period> for String {
    fn from(period: Period) -> Self {
        period.as_token()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_token())
    }
}
