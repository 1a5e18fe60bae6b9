use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse game-length bucket keeping baselines comparable across games of
/// similar length. Bucketed on game duration in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DurationBucket {
    Short,
    Standard,
    Long
}

impl DurationBucket {
    pub fn from_seconds(duration: i64) -> DurationBucket {
        if duration < 1200 {
            DurationBucket::Short
        } else if duration < 1800 {
            DurationBucket::Standard
        } else {
            DurationBucket::Long
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DurationBucket::Short => "0-20",
            DurationBucket::Standard => "20-30",
            DurationBucket::Long => "30+"
        }
    }
}

impl fmt::Display for DurationBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
