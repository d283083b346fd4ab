/// All wall-clock timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Backend node timestamps are unix seconds, possibly fractional.
pub type UnixSeconds = f64;
