use chrono::{DateTime, Local, TimeZone};
use serde::Serialize;

use crate::{Error, Result};

/// Half-open range `[start, end)` of last-sync times, in epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonitorWindow {
    pub start: i64,
    pub end: i64,
}

impl MonitorWindow {
    /// The window of length `interval` that ends `offset` seconds before `now`.
    pub fn ending_before(now: i64, offset: i64, interval: i64) -> Result<Self> {
        if offset < 0 {
            return Err(Error::validation(format!(
                "time offset must not be negative, got {offset}"
            )));
        }
        if interval <= 0 {
            return Err(Error::validation(format!(
                "time interval must be positive, got {interval}"
            )));
        }

        let out_of_range = || {
            Error::validation(format!(
                "time offset {offset} and interval {interval} reach before the epoch range"
            ))
        };
        let end = now.checked_sub(offset).ok_or_else(out_of_range)?;
        let start = end.checked_sub(interval).ok_or_else(out_of_range)?;
        Ok(Self { start, end })
    }

    pub fn contains(&self, ts: i64) -> bool {
        self.start <= ts && ts < self.end
    }

    /// `YYYY-mm-dd HH:MM:SS` in local time, for logs and views.
    pub fn describe(&self) -> String {
        format!("[{}, {})", format_ts(self.start), format_ts(self.end))
    }
}

/// Local `YYYY-mm-dd HH:MM:SS`; zero or out-of-range timestamps render empty.
pub fn format_ts(ts: i64) -> String {
    if ts == 0 {
        return String::new();
    }
    Local
        .timestamp_opt(ts, 0)
        .single()
        .map(|dt: DateTime<Local>| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_bounds() {
        let window = MonitorWindow::ending_before(10_000, 3_600, 600).unwrap();
        assert_eq!(window.start, 10_000 - 3_600 - 600);
        assert_eq!(window.end, 10_000 - 3_600);
    }

    #[test]
    fn test_window_is_half_open() {
        let window = MonitorWindow::ending_before(1_000, 100, 50).unwrap();
        assert!(window.contains(850));
        assert!(window.contains(899));
        assert!(!window.contains(900));
        assert!(!window.contains(849));
    }

    #[test]
    fn test_zero_offset() {
        let window = MonitorWindow::ending_before(1_000, 0, 60).unwrap();
        assert_eq!((window.start, window.end), (940, 1_000));
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(matches!(
            MonitorWindow::ending_before(1_000, -1, 60),
            Err(Error::Validation(_))
        ));
        assert!(MonitorWindow::ending_before(1_000, 0, 0).is_err());
        assert!(MonitorWindow::ending_before(1_000, 0, -5).is_err());
    }

    #[test]
    fn test_huge_settings_are_rejected_not_wrapped() {
        assert!(matches!(
            MonitorWindow::ending_before(i64::MIN + 10, 100, 60),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            MonitorWindow::ending_before(-10, 0, i64::MAX),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            MonitorWindow::ending_before(-10, i64::MAX, 60),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_format_ts_empty_for_zero() {
        assert_eq!(format_ts(0), "");
        assert_eq!(format_ts(1_700_000_000).len(), 19);
    }
}
