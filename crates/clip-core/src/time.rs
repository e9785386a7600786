use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// Time duration with sub-millisecond precision (stored as fractional seconds).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Duration {
    seconds: f64,
}

impl Duration {
    /// Create a duration from seconds. Negative values clamp to zero.
    pub fn from_seconds(s: f64) -> Self {
        Self {
            seconds: s.max(0.0),
        }
    }

    /// Create a duration from milliseconds.
    pub fn from_millis(ms: f64) -> Self {
        Self::from_seconds(ms / 1000.0)
    }

    pub fn zero() -> Self {
        Self { seconds: 0.0 }
    }

    pub fn as_seconds(&self) -> f64 {
        self.seconds
    }

    pub fn as_millis(&self) -> f64 {
        self.seconds * 1000.0
    }

    /// Number of sampled frames this duration spans at a given frame rate.
    pub fn frame_count(&self, fps: f64) -> u64 {
        (self.seconds * fps).ceil() as u64
    }
}

impl Default for Duration {
    fn default() -> Self {
        Duration::zero()
    }
}

impl Add for Duration {
    type Output = Duration;
    fn add(self, rhs: Duration) -> Duration {
        Duration::from_seconds(self.seconds + rhs.seconds)
    }
}

impl Sub for Duration {
    type Output = Duration;
    fn sub(self, rhs: Duration) -> Duration {
        Duration::from_seconds((self.seconds - rhs.seconds).max(0.0))
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.seconds < 1.0 {
            write!(f, "{:.0}ms", self.seconds * 1000.0)
        } else {
            write!(f, "{:.2}s", self.seconds)
        }
    }
}

/// A point in time within a recording, measured from its start.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Timestamp {
    seconds: f64,
}

impl Timestamp {
    pub fn from_seconds(s: f64) -> Self {
        Self {
            seconds: s.max(0.0),
        }
    }

    pub fn from_millis(ms: f64) -> Self {
        Self::from_seconds(ms / 1000.0)
    }

    pub fn zero() -> Self {
        Self { seconds: 0.0 }
    }

    pub fn as_seconds(&self) -> f64 {
        self.seconds
    }

    pub fn as_millis(&self) -> f64 {
        self.seconds * 1000.0
    }

    /// Convert to a frame index at a given frame rate.
    pub fn to_frame(&self, fps: f64) -> u64 {
        (self.seconds * fps).floor() as u64
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Timestamp::zero()
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;
    fn add(self, rhs: Duration) -> Timestamp {
        Timestamp::from_seconds(self.seconds + rhs.as_seconds())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_conversions() {
        let d = Duration::from_millis(2500.0);
        assert!((d.as_seconds() - 2.5).abs() < 1e-9);
        assert!((d.as_millis() - 2500.0).abs() < 1e-6);
    }

    #[test]
    fn test_duration_clamps_negative() {
        assert_eq!(Duration::from_seconds(-1.0).as_seconds(), 0.0);
    }

    #[test]
    fn test_frame_count_rounds_up() {
        assert_eq!(Duration::from_seconds(1.0).frame_count(30.0), 30);
        assert_eq!(Duration::from_seconds(6.0).frame_count(30.0), 180);
        assert_eq!(Duration::from_millis(100.0).frame_count(30.0), 3);
    }

    #[test]
    fn test_duration_display() {
        assert_eq!(format!("{}", Duration::from_seconds(6.0)), "6.00s");
        assert_eq!(format!("{}", Duration::from_millis(33.0)), "33ms");
    }

    #[test]
    fn test_timestamp_to_frame() {
        assert_eq!(Timestamp::from_seconds(1.0).to_frame(30.0), 30);
        assert_eq!(Timestamp::from_millis(999.0).to_frame(30.0), 29);
    }

    #[test]
    fn test_timestamp_add_duration() {
        let ts = Timestamp::from_seconds(1.0) + Duration::from_millis(500.0);
        assert!((ts.as_seconds() - 1.5).abs() < 1e-9);
    }
}
