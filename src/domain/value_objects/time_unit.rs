use serde::{Deserialize, Serialize};

const SECS_IN_MINUTE: u64 = 60;
const SECS_IN_HOUR: u64 = 60 * SECS_IN_MINUTE;
const SECS_IN_DAY: u64 = 24 * SECS_IN_HOUR;

/// Unit of a user-entered duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    pub fn seconds(self) -> u64 {
        match self {
            TimeUnit::Minutes => SECS_IN_MINUTE,
            TimeUnit::Hours => SECS_IN_HOUR,
            TimeUnit::Days => SECS_IN_DAY,
        }
    }

    /// Single-letter form used in query strings (`m`, `h`, `d`).
    pub fn short(self) -> char {
        match self {
            TimeUnit::Minutes => 'm',
            TimeUnit::Hours => 'h',
            TimeUnit::Days => 'd',
        }
    }

    pub fn from_short(c: char) -> Option<Self> {
        match c {
            'm' => Some(TimeUnit::Minutes),
            'h' => Some(TimeUnit::Hours),
            'd' => Some(TimeUnit::Days),
            _ => None,
        }
    }
}
