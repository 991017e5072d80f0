use super::time_unit::TimeUnit;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::fmt;
use tracing::error;
use url::form_urlencoded;

const PARAM_SINCE: &str = "since";
const PARAM_DUR: &str = "dur";
/// Legacy name for `dur`, accepted on parse only.
const PARAM_LEN: &str = "len";
const PARAM_AGO: &str = "ago";

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

/// Unresolved, user- or URL-supplied specification of a wayback window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaybackQueryInputs {
    /// Absolute start plus a relative length.
    SinceAndDur {
        /// `yyyy-MM-ddTHH:mm` style datetime, interpreted as UTC.
        since_datetime: String,
        duration_value: u64,
        duration_unit: TimeUnit,
    },
    /// Relative length ending at "now"; re-resolved as time passes.
    UntilNow {
        duration_value: u64,
        duration_unit: TimeUnit,
    },
}

impl WaybackQueryInputs {
    /// Parses a flat query string (`a=b&c=d`, optional leading `?`).
    ///
    /// Missing, unknown or malformed parameter groups yield `None`; query
    /// strings come from user-editable URLs, so nothing here is an error.
    pub fn from_url_query(query: &str) -> Option<Self> {
        let query = query.trim_start_matches('?');
        let mut since = None;
        let mut dur = None;
        let mut len = None;
        let mut ago = None;
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                PARAM_SINCE if since.is_none() => since = Some(value.into_owned()),
                PARAM_DUR if dur.is_none() => dur = Some(value.into_owned()),
                PARAM_LEN if len.is_none() => len = Some(value.into_owned()),
                PARAM_AGO if ago.is_none() => ago = Some(value.into_owned()),
                _ => {}
            }
        }

        if let (Some(since_datetime), Some(dur_str)) = (since, dur.or(len)) {
            let (duration_value, duration_unit) = parse_duration(&dur_str)?;
            return Some(Self::SinceAndDur {
                since_datetime,
                duration_value,
                duration_unit,
            });
        }
        if let Some(ago_str) = ago {
            let (duration_value, duration_unit) = parse_duration(&ago_str)?;
            return Some(Self::UntilNow {
                duration_value,
                duration_unit,
            });
        }
        None
    }

    /// Serializes back to the flat query-string form. Round-trips with
    /// [`Self::from_url_query`] for every valid input.
    pub fn to_url_query(&self) -> String {
        let mut params = form_urlencoded::Serializer::new(String::new());
        match self {
            Self::SinceAndDur {
                since_datetime,
                duration_value,
                duration_unit,
            } => {
                params.append_pair(PARAM_SINCE, since_datetime);
                params.append_pair(PARAM_DUR, &format_duration(*duration_value, *duration_unit));
            }
            Self::UntilNow {
                duration_value,
                duration_unit,
            } => {
                params.append_pair(PARAM_AGO, &format_duration(*duration_value, *duration_unit));
            }
        }
        params.finish()
    }
}

fn parse_duration(s: &str) -> Option<(u64, TimeUnit)> {
    let unit = TimeUnit::from_short(s.chars().last()?)?;
    let digits = &s[..s.len() - 1];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value = digits.parse::<u64>().ok()?;
    Some((value, unit))
}

fn format_duration(value: u64, unit: TimeUnit) -> String {
    format!("{value}{unit}", unit = unit.short())
}

/// A resolved, concrete time window `[since, until)` in unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaybackQuery {
    pub since: i64,
    pub until: i64,
}

impl WaybackQuery {
    /// Resolves inputs against the wall clock.
    pub fn from_inputs(inputs: &WaybackQueryInputs) -> Option<Self> {
        Self::from_inputs_at(inputs, Utc::now().timestamp())
    }

    /// Resolves inputs against an explicit "now", in unix seconds.
    ///
    /// Yields `None` for a zero or overflowing duration, an unparsable start
    /// datetime, or a window that would start after `now`.
    pub fn from_inputs_at(inputs: &WaybackQueryInputs, now: i64) -> Option<Self> {
        match inputs {
            WaybackQueryInputs::SinceAndDur {
                since_datetime,
                duration_value,
                duration_unit,
            } => {
                if *duration_value == 0 {
                    return None;
                }
                let since = parse_datetime(since_datetime)?;
                let dur = duration_secs(*duration_value, *duration_unit)?;
                let until = since.checked_add(dur)?.min(now);
                if until < since {
                    return None;
                }
                Some(Self { since, until })
            }
            WaybackQueryInputs::UntilNow {
                duration_value,
                duration_unit,
            } => {
                if *duration_value == 0 {
                    return None;
                }
                // Round up to the end of the current minute so the window
                // stays stable until the next minute boundary.
                let until = now - now.rem_euclid(60) + 59;
                let dur = duration_secs(*duration_value, *duration_unit)?;
                Some(Self {
                    since: until.checked_sub(dur)?,
                    until,
                })
            }
        }
    }

    /// Whether a creation timestamp falls inside the window.
    pub fn contains(&self, created_at: i64) -> bool {
        created_at >= self.since && created_at < self.until
    }
}

impl fmt::Display for WaybackQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}",
            format_unixtime(self.since),
            format_unixtime(self.until)
        )
    }
}

fn parse_datetime(s: &str) -> Option<i64> {
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt.and_utc().timestamp());
        }
    }
    error!("invalid since datetime: {s}");
    None
}

fn duration_secs(value: u64, unit: TimeUnit) -> Option<i64> {
    i64::try_from(value)
        .ok()?
        .checked_mul(unit.seconds() as i64)
}

fn format_unixtime(unixtime: i64) -> String {
    match DateTime::<Utc>::from_timestamp(unixtime, 0) {
        Some(dt) => dt.format("%Y/%m/%d %H:%M").to_string(),
        None => unixtime.to_string(),
    }
}
