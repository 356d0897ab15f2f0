//! CF-convention time axis decoding (`"<unit> since <epoch>"`).

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::error::{NetCdfError, NetCdfResult};

/// Unit of a CF time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    fn seconds(self) -> f64 {
        match self {
            TimeUnit::Seconds => 1.0,
            TimeUnit::Minutes => 60.0,
            TimeUnit::Hours => 3_600.0,
            TimeUnit::Days => 86_400.0,
        }
    }
}

/// Parsed `units` attribute of a time variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeUnits {
    pub unit: TimeUnit,
    pub epoch: NaiveDateTime,
}

impl TimeUnits {
    /// Parse e.g. `"days since 1950-01-01 00:00:00"` or `"hours since 2000-01-01T00:00:00Z"`.
    pub fn parse(units: &str) -> NetCdfResult<Self> {
        let (unit, epoch) = units
            .split_once(" since ")
            .ok_or_else(|| NetCdfError::invalid(format!("time units '{units}'")))?;

        let unit = match unit.trim().to_ascii_lowercase().as_str() {
            "seconds" | "second" | "secs" | "s" => TimeUnit::Seconds,
            "minutes" | "minute" | "mins" => TimeUnit::Minutes,
            "hours" | "hour" | "hrs" | "h" => TimeUnit::Hours,
            "days" | "day" | "d" => TimeUnit::Days,
            other => return Err(NetCdfError::invalid(format!("time unit '{other}'"))),
        };

        Ok(Self {
            unit,
            epoch: parse_epoch(epoch.trim())
                .ok_or_else(|| NetCdfError::invalid(format!("time epoch '{epoch}'")))?,
        })
    }

    /// Timestamp of one axis value. `None` for non-finite values.
    pub fn decode(&self, value: f64) -> Option<NaiveDateTime> {
        if !value.is_finite() {
            return None;
        }
        let millis = (value * self.unit.seconds() * 1000.0).round();
        self.epoch
            .checked_add_signed(Duration::try_milliseconds(millis as i64)?)
    }

    /// Calendar date of one axis value.
    pub fn decode_date(&self, value: f64) -> Option<NaiveDate> {
        self.decode(value).map(|t| t.date())
    }
}

fn parse_epoch(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim_end_matches('Z').trim_end_matches(" UTC");
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(t);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
