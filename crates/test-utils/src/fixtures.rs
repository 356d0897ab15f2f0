//! Fixture extents and dates that mirror the production inputs.

/// Bounding boxes as `(min_lon, min_lat, max_lon, max_lat)`.
pub mod bbox {
    /// Default simulator target domain (North Pacific).
    pub const NORTH_PACIFIC: (f64, f64, f64, f64) = (120.0, 15.0, 185.0, 65.0);

    /// A small source domain used by regrid tests.
    pub const SMALL_SOURCE: (f64, f64, f64, f64) = (140.0, 30.0, 150.0, 40.0);

    /// `SMALL_SOURCE` extended 5 degrees east.
    pub const SMALL_SOURCE_EAST_5: (f64, f64, f64, f64) = (140.0, 30.0, 155.0, 40.0);
}

/// Physics constants of the diffusivity pipeline.
pub mod physics {
    /// Empirical scale constant.
    pub const C: f64 = 0.1;
    /// Anomaly scaling factor.
    pub const ALPHA: f64 = 0.1;
    /// Lagrangian timescale of 7 days, in seconds.
    pub const T_L_SECONDS: f64 = 604_800.0;
    /// Physical ceiling on K (m²/s).
    pub const K_MAX: f64 = 3000.0;
}

/// Dates used by the end-to-end tests.
pub mod dates {
    use chrono::NaiveDate;

    /// First day of the production period.
    pub fn base_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2011, 3, 1).expect("valid date")
    }

    /// Last day of the production period.
    pub fn last_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2013, 2, 28).expect("valid date")
    }
}

/// Default requested depth levels (meters).
pub const DEPTH_LEVELS: [f64; 6] = [0.0, 50.0, 100.0, 200.0, 500.0, 1000.0];
