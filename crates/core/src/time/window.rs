use anyhow::Context;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

/// Response key format, e.g. `19-10-2026`.
pub const DATE_KEY_FORMAT: &str = "%d-%m-%Y";

/// Yesterday, today and tomorrow relative to a reference date, in that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    dates: [NaiveDate; 3],
}

impl DateWindow {
    pub fn around(today: NaiveDate) -> anyhow::Result<Self> {
        let yesterday = today
            .pred_opt()
            .with_context(|| format!("no calendar day before {today}"))?;
        let tomorrow = today
            .succ_opt()
            .with_context(|| format!("no calendar day after {today}"))?;
        Ok(Self {
            dates: [yesterday, today, tomorrow],
        })
    }

    /// Window around the calendar date that `now_utc` falls on at `offset`.
    pub fn at(now_utc: DateTime<Utc>, offset: FixedOffset) -> anyhow::Result<Self> {
        Self::around(now_utc.with_timezone(&offset).date_naive())
    }

    pub fn current(offset: FixedOffset) -> anyhow::Result<Self> {
        Self::at(Utc::now(), offset)
    }

    pub fn dates(&self) -> [NaiveDate; 3] {
        self.dates
    }

    pub fn today(&self) -> NaiveDate {
        self.dates[1]
    }
}

/// Zero-padded upstream query components for one date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateParts {
    pub day: String,
    pub month: String,
    pub year: String,
}

impl From<NaiveDate> for DateParts {
    fn from(date: NaiveDate) -> Self {
        Self {
            day: date.format("%d").to_string(),
            month: date.format("%m").to_string(),
            year: date.format("%Y").to_string(),
        }
    }
}

pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}
