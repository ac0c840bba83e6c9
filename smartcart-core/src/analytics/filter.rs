//! Date ranges and session predicates.
//!
//! All ranges are calendar-date bounds in UTC. The `to` date is inclusive
//! through the last millisecond of that day.

use crate::error::{Error, Result};
use crate::types::{Session, SessionStatus};
use chrono::{DateTime, Days, NaiveDate, Utc};
use std::fmt;

/// Date parameters are ISO calendar dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Inclusive range of whole UTC days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    from: NaiveDate,
    to: NaiveDate,
}

fn parse_date(name: &str, value: Option<&str>) -> Result<NaiveDate> {
    let value = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::InvalidRange(format!("missing `{name}` date")))?;
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| {
        Error::InvalidRange(format!("`{name}` must be YYYY-MM-DD, got {value:?}"))
    })
}

fn start_of(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

impl DateRange {
    /// Range over `[from, to]`. Rejects `from` after `to`.
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self> {
        if from > to {
            return Err(Error::InvalidRange(format!(
                "`from` ({from}) is after `to` ({to})"
            )));
        }
        Ok(Self { from, to })
    }

    /// Parse `from`/`to` request parameters. Both are required.
    pub fn parse(from: Option<&str>, to: Option<&str>) -> Result<Self> {
        let from = parse_date("from", from)?;
        let to = parse_date("to", to)?;
        Self::new(from, to)
    }

    /// Single-day range from a `date` request parameter.
    pub fn for_day(date: Option<&str>) -> Result<Self> {
        let date = parse_date("date", date)?;
        Ok(Self::day(date))
    }

    pub fn day(date: NaiveDate) -> Self {
        Self {
            from: date,
            to: date,
        }
    }

    /// The `days` calendar days ending with `today`, inclusive.
    pub fn last_days(today: NaiveDate, days: u32) -> Self {
        let from = today
            .checked_sub_days(Days::new(u64::from(days.saturating_sub(1))))
            .unwrap_or(NaiveDate::MIN);
        Self { from, to: today }
    }

    pub fn from_date(&self) -> NaiveDate {
        self.from
    }

    pub fn to_date(&self) -> NaiveDate {
        self.to
    }

    /// First instant of the range.
    pub fn start(&self) -> DateTime<Utc> {
        start_of(self.from)
    }

    /// Last millisecond of the `to` day.
    pub fn end(&self) -> DateTime<Utc> {
        self.to
            .and_hms_milli_opt(23, 59, 59, 999)
            .map(|naive| naive.and_utc())
            .unwrap_or_else(|| start_of(self.to))
    }

    /// `ts` within `[start, end]`.
    pub fn contains(&self, ts: &DateTime<Utc>) -> bool {
        *ts >= self.start() && *ts <= self.end()
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}..={}",
            self.from.format(DATE_FORMAT),
            self.to.format(DATE_FORMAT)
        )
    }
}

/// Condition a session must satisfy to be aggregated.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionPredicate {
    Status(SessionStatus),
    /// `startedAt` within the range; sessions without one never match
    StartedWithin(DateRange),
    /// `endedAt` within the range; sessions without one never match
    EndedWithin(DateRange),
    All(Vec<SessionPredicate>),
}

impl SessionPredicate {
    /// Completed sessions that ended within `range`.
    pub fn completed_within(range: DateRange) -> Self {
        SessionPredicate::All(vec![
            SessionPredicate::Status(SessionStatus::Completed),
            SessionPredicate::EndedWithin(range),
        ])
    }

    pub fn matches(&self, session: &Session) -> bool {
        match self {
            SessionPredicate::Status(status) => session.status == *status,
            SessionPredicate::StartedWithin(range) => session
                .started_at
                .as_ref()
                .is_some_and(|ts| range.contains(ts)),
            SessionPredicate::EndedWithin(range) => session
                .ended_at
                .as_ref()
                .is_some_and(|ts| range.contains(ts)),
            SessionPredicate::All(predicates) => predicates.iter().all(|p| p.matches(session)),
        }
    }
}

/// Sessions matching `predicate`, in input order.
pub fn filter_sessions<'a>(sessions: &'a [Session], predicate: &SessionPredicate) -> Vec<&'a Session> {
    sessions.iter().filter(|s| predicate.matches(s)).collect()
}
