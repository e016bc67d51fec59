//! Time utilities for patchward
//!
//! Unattended installs and reboots are only permitted inside a configured
//! quiet-hours window. The window is expressed as whole clock hours and may
//! cross midnight (e.g. 23..5).

use chrono::{DateTime, Local, Timelike};
use serde::{Deserialize, Serialize};

/// A clock-hour window during which unattended, disruptive actions are
/// permitted.
///
/// The window is half-open: `[start, end)`. When `start > end` the window
/// crosses midnight, so an hour matches if it is at or after `start` OR
/// before `end`. `start == end` denotes a window that is always open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuietHours {
    start: u8,
    end: u8,
}

impl QuietHours {
    /// Build a window from whole clock hours. Returns `None` if either hour
    /// is out of the 0..24 range.
    pub fn new(start: u8, end: u8) -> Option<Self> {
        if start < 24 && end < 24 {
            Some(Self { start, end })
        } else {
            None
        }
    }

    pub fn start(&self) -> u8 {
        self.start
    }

    pub fn end(&self) -> u8 {
        self.end
    }

    /// Check whether the given clock hour falls inside the window.
    pub fn contains_hour(&self, hour: u8) -> bool {
        if self.start < self.end {
            self.start <= hour && hour < self.end
        } else {
            // Window crosses midnight (e.g. 23..5)
            self.start <= hour || hour < self.end
        }
    }

    /// Check whether the given local datetime falls inside the window.
    pub fn contains(&self, dt: &DateTime<Local>) -> bool {
        self.contains_hour(dt.hour() as u8)
    }
}

impl std::fmt::Display for QuietHours {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:00-{:02}:00", self.start, self.end)
    }
}

/// Format a deferral deadline the way it is shown in dialogs.
pub fn format_deadline(dt: &DateTime<Local>) -> String {
    dt.format("%a, %d %b %H:%M:%S").to_string()
}

/// Format a DateTime for log lines and the persisted record's debug output.
pub fn format_datetime_full(dt: &DateTime<Local>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn plain_window_is_half_open() {
        let window = QuietHours::new(9, 17).unwrap();
        assert!(!window.contains_hour(8));
        assert!(window.contains_hour(9));
        assert!(window.contains_hour(16));
        assert!(!window.contains_hour(17));
        assert!(!window.contains_hour(23));
    }

    #[test]
    fn wraparound_window_crosses_midnight() {
        let window = QuietHours::new(23, 5).unwrap();
        assert!(window.contains_hour(23));
        assert!(window.contains_hour(0));
        assert!(window.contains_hour(4));
        assert!(!window.contains_hour(5));
        assert!(!window.contains_hour(12));
        assert!(!window.contains_hour(22));
    }

    #[test]
    fn equal_bounds_window_is_always_open() {
        let window = QuietHours::new(3, 3).unwrap();
        for hour in 0..24 {
            assert!(window.contains_hour(hour));
        }
    }

    #[test]
    fn rejects_out_of_range_hours() {
        assert!(QuietHours::new(24, 5).is_none());
        assert!(QuietHours::new(0, 24).is_none());
        assert!(QuietHours::new(0, 23).is_some());
    }

    #[test]
    fn contains_uses_local_hour() {
        let window = QuietHours::new(23, 5).unwrap();
        let night = Local.with_ymd_and_hms(2026, 3, 2, 2, 15, 0).unwrap();
        let noon = Local.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap();
        assert!(window.contains(&night));
        assert!(!window.contains(&noon));
    }

    #[test]
    fn deadline_format() {
        let dt = Local.with_ymd_and_hms(2026, 3, 6, 14, 30, 45).unwrap();
        // 2026-03-06 is a Friday
        assert_eq!(format_deadline(&dt), "Fri, 06 Mar 14:30:45");
    }

    #[test]
    fn full_format() {
        let dt = Local.with_ymd_and_hms(2026, 3, 6, 14, 30, 45).unwrap();
        assert_eq!(format_datetime_full(&dt), "2026-03-06 14:30:45");
    }

    #[test]
    fn display_is_zero_padded() {
        let window = QuietHours::new(23, 5).unwrap();
        assert_eq!(window.to_string(), "23:00-05:00");
    }
}
