use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

/// Periodic refresh cadence offered to the user
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Interval {
    #[default]
    Disabled,
    OneSecond,
    FiveSeconds,
    TenSeconds,
    TwentySeconds,
    ThirtySeconds,
}

impl Interval {
    pub const ALL: [Interval; 6] = [
        Interval::Disabled,
        Interval::OneSecond,
        Interval::FiveSeconds,
        Interval::TenSeconds,
        Interval::TwentySeconds,
        Interval::ThirtySeconds,
    ];

    /// Time between passes, `None` when periodic refresh is off
    pub fn period(self) -> Option<Duration> {
        let secs = match self {
            Interval::Disabled => return None,
            Interval::OneSecond => 1,
            Interval::FiveSeconds => 5,
            Interval::TenSeconds => 10,
            Interval::TwentySeconds => 20,
            Interval::ThirtySeconds => 30,
        };
        Some(Duration::from_secs(secs))
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.period() {
            None => write!(f, "disabled"),
            Some(period) => write!(f, "{} sec", period.as_secs()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIntervalError(String);

impl fmt::Display for ParseIntervalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid refresh interval '{}' (expected off, 1, 5, 10, 20 or 30)",
            self.0
        )
    }
}

impl std::error::Error for ParseIntervalError {}

impl FromStr for Interval {
    type Err = ParseIntervalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().to_ascii_lowercase();
        let secs = trimmed
            .strip_suffix("sec")
            .or_else(|| trimmed.strip_suffix('s'))
            .unwrap_or(&trimmed)
            .trim();

        match secs {
            "off" | "disabled" | "0" => Ok(Interval::Disabled),
            "1" => Ok(Interval::OneSecond),
            "5" => Ok(Interval::FiveSeconds),
            "10" => Ok(Interval::TenSeconds),
            "20" => Ok(Interval::TwentySeconds),
            "30" => Ok(Interval::ThirtySeconds),
            _ => Err(ParseIntervalError(s.to_string())),
        }
    }
}

/// Decides when the next periodic refresh pass is due
///
/// The next deadline is set from the moment a pass finishes, so a slow pass
/// pushes the following one back instead of overlapping it.
#[derive(Debug, Clone)]
pub struct Ticker {
    interval: Interval,
    due: Option<Instant>,
}

impl Ticker {
    pub fn new(interval: Interval, now: Instant) -> Self {
        Ticker {
            interval,
            due: interval.period().map(|period| now + period),
        }
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    /// Switches cadence, restarting the countdown
    pub fn set_interval(&mut self, interval: Interval, now: Instant) {
        *self = Ticker::new(interval, now);
    }

    pub fn is_due(&self, now: Instant) -> bool {
        matches!(self.due, Some(due) if now >= due)
    }

    /// Time left until the next pass, `None` when disabled
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.due.map(|due| due.saturating_duration_since(now))
    }

    /// Records that a pass completed at `now`
    pub fn finished(&mut self, now: Instant) {
        self.due = self.interval.period().map(|period| now + period);
    }
}
