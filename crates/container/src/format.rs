//! Container layouts.
//!
//! All integers are i32 and all floats are f32 or f16, little-endian.
//!
//! ```text
//! coordinates  v6  [6, n_lat, n_lon] lon[n] lat[n]                        (f32)
//! daily field  v6  [6, year, month, day, trunc(max_err * 1000)] data[n]   (f16)
//! currents     v4  [4, n_lat, n_lon, n_depth, year, month, day]
//!                  lon[n] lat[n] u[n_depth][n] v[n_depth][n]              (f32)
//! ```
//!
//! In the currents layout `NaN` is written as [`MISSING_SENTINEL`] and any
//! value at or below it reads back as `NaN`.

use std::fmt;

use bytes::BufMut;
use chrono::{Datelike, NaiveDate};

use crate::error::{ContainerError, Result};

/// Version of the coordinates and daily field layouts.
pub const VERSION_6: i32 = 6;
/// Version of the currents layout.
pub const VERSION_4: i32 = 4;

/// Missing-value marker in the currents layout.
pub const MISSING_SENTINEL: f32 = -9999.0;

/// Header integers of the coordinates layout.
pub const COORDINATES_HEADER_INTS: usize = 3;
/// Header integers of the daily field layout.
pub const DAILY_HEADER_INTS: usize = 5;
/// Header integers of the currents layout.
pub const CURRENTS_HEADER_INTS: usize = 7;

/// File name of the coordinates container.
pub const COORDINATES_FILE_NAME: &str = "eke_coords.bin";

/// `eke_YYYYMMDD.bin`
pub fn daily_file_name(date: NaiveDate) -> String {
    format!("eke_{}.bin", field_common::compact_date(date))
}

/// `currents_YYYY_MM_DD.bin`
pub fn currents_file_name(date: NaiveDate) -> String {
    format!("currents_{}.bin", date.format("%Y_%m_%d"))
}

/// A decoded container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Header {
    Coordinates {
        n_lat: usize,
        n_lon: usize,
    },
    Daily {
        date: NaiveDate,
        scaled_max_error: i32,
    },
    Currents {
        n_lat: usize,
        n_lon: usize,
        n_depth: usize,
        date: NaiveDate,
    },
}

impl Header {
    pub fn version(&self) -> i32 {
        match self {
            Header::Coordinates { .. } | Header::Daily { .. } => VERSION_6,
            Header::Currents { .. } => VERSION_4,
        }
    }

    /// Header size in bytes.
    pub fn byte_len(&self) -> usize {
        4 * match self {
            Header::Coordinates { .. } => COORDINATES_HEADER_INTS,
            Header::Daily { .. } => DAILY_HEADER_INTS,
            Header::Currents { .. } => CURRENTS_HEADER_INTS,
        }
    }

    /// Date carried by the header, if the layout has one.
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Header::Coordinates { .. } => None,
            Header::Daily { date, .. } | Header::Currents { date, .. } => Some(*date),
        }
    }

    /// Append the header integers to `buf`.
    pub fn encode<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        buf.put_i32_le(self.version());
        match *self {
            Header::Coordinates { n_lat, n_lon } => {
                buf.put_i32_le(dim(n_lat)?);
                buf.put_i32_le(dim(n_lon)?);
            }
            Header::Daily {
                date,
                scaled_max_error,
            } => {
                put_date(buf, date);
                buf.put_i32_le(scaled_max_error);
            }
            Header::Currents {
                n_lat,
                n_lon,
                n_depth,
                date,
            } => {
                buf.put_i32_le(dim(n_lat)?);
                buf.put_i32_le(dim(n_lon)?);
                buf.put_i32_le(dim(n_depth)?);
                put_date(buf, date);
            }
        }
        Ok(())
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Header::Coordinates { n_lat, n_lon } => {
                write!(f, "coordinates v6: {n_lat}x{n_lon}")
            }
            Header::Daily {
                date,
                scaled_max_error,
            } => write!(
                f,
                "daily field v6: {date}, max error {:.3}",
                *scaled_max_error as f64 / 1000.0
            ),
            Header::Currents {
                n_lat,
                n_lon,
                n_depth,
                date,
            } => write!(f, "currents v4: {date}, {n_depth} depths on {n_lat}x{n_lon}"),
        }
    }
}

fn dim(n: usize) -> Result<i32> {
    i32::try_from(n).map_err(|_| ContainerError::malformed(format!("dimension {n} exceeds i32")))
}

fn put_date<B: BufMut>(buf: &mut B, date: NaiveDate) {
    buf.put_i32_le(date.year());
    buf.put_i32_le(date.month() as i32);
    buf.put_i32_le(date.day() as i32);
}

/// Date from header integers, if they form a valid calendar date.
pub(crate) fn date_from_ints(year: i32, month: i32, day: i32) -> Option<NaiveDate> {
    let month = u32::try_from(month).ok()?;
    let day = u32::try_from(day).ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Replace `NaN` with the sentinel.
pub fn to_sentinel(value: f32) -> f32 {
    if value.is_nan() {
        MISSING_SENTINEL
    } else {
        value
    }
}

/// Map sentinel-or-below back to `NaN`.
pub fn from_sentinel(value: f32) -> f32 {
    if value <= MISSING_SENTINEL {
        f32::NAN
    } else {
        value
    }
}
