//! Interval configuration.
//!
//! Durations accept the same short syntax as the rest of Tempo's config
//! files: `"500ms"`, `"5s"`, `"2m"`, or a bare number of seconds.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{HealthError, HealthResult};
use crate::status::EventKind;

/// Consecutive failures (counting the one that entered suspect) before
/// a monitor escalates to unhealthy.
pub const DEFAULT_MAX_SUSPECT_COUNT: u32 = 3;

/// Consecutive successes required to return to healthy.
pub const DEFAULT_MIN_HEALTHY_COUNT: u32 = 2;

/// Probe intervals per status, plus the hysteresis thresholds.
///
/// Immutable once handed to a [`Monitor`](crate::Monitor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalConfig {
    /// Delay between probes while healthy.
    #[serde(with = "duration_str")]
    pub healthy: Duration,
    /// Delay between probes while suspect.
    #[serde(with = "duration_str")]
    pub suspect: Duration,
    /// Delay between probes while unhealthy.
    #[serde(with = "duration_str")]
    pub unhealthy: Duration,
    #[serde(default = "default_max_suspect_count")]
    pub max_suspect_count: u32,
    #[serde(default = "default_min_healthy_count")]
    pub min_healthy_count: u32,
    /// Probes running longer than this count as failed.
    #[serde(
        default,
        with = "opt_duration_str",
        skip_serializing_if = "Option::is_none"
    )]
    pub probe_timeout: Option<Duration>,
}

fn default_max_suspect_count() -> u32 {
    DEFAULT_MAX_SUSPECT_COUNT
}

fn default_min_healthy_count() -> u32 {
    DEFAULT_MIN_HEALTHY_COUNT
}

impl IntervalConfig {
    /// Create a config with the default thresholds and no probe timeout.
    pub fn new(healthy: Duration, suspect: Duration, unhealthy: Duration) -> Self {
        Self {
            healthy,
            suspect,
            unhealthy,
            max_suspect_count: DEFAULT_MAX_SUSPECT_COUNT,
            min_healthy_count: DEFAULT_MIN_HEALTHY_COUNT,
            probe_timeout: None,
        }
    }

    pub fn with_max_suspect_count(mut self, count: u32) -> Self {
        self.max_suspect_count = count;
        self
    }

    pub fn with_min_healthy_count(mut self, count: u32) -> Self {
        self.min_healthy_count = count;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = Some(timeout);
        self
    }

    /// Check the thresholds and timeout are usable.
    pub fn validate(&self) -> HealthResult<()> {
        if self.max_suspect_count == 0 {
            return Err(HealthError::InvalidConfig {
                field: "max_suspect_count",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.min_healthy_count == 0 {
            return Err(HealthError::InvalidConfig {
                field: "min_healthy_count",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.probe_timeout == Some(Duration::ZERO) {
            return Err(HealthError::InvalidConfig {
                field: "probe_timeout",
                reason: "must be greater than zero".to_string(),
            });
        }

        // Config files carry millisecond precision at most.
        let durations = [
            ("healthy", Some(self.healthy)),
            ("suspect", Some(self.suspect)),
            ("unhealthy", Some(self.unhealthy)),
            ("probe_timeout", self.probe_timeout),
        ];
        for (field, duration) in durations {
            if duration.is_some_and(|d| d.subsec_nanos() % 1_000_000 != 0) {
                return Err(HealthError::InvalidConfig {
                    field,
                    reason: "must be a whole number of milliseconds".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Delay before the next probe for the given kind.
    ///
    /// `Error` has no interval of its own and uses the unhealthy one.
    pub fn interval_for(&self, kind: EventKind) -> Duration {
        match kind {
            EventKind::Healthy => self.healthy,
            EventKind::Suspect => self.suspect,
            EventKind::Unhealthy | EventKind::Error => self.unhealthy,
        }
    }
}

/// Parse a duration string like "5s", "500ms", "2m", or "10".
pub fn parse_duration(s: &str) -> HealthResult<Duration> {
    let trimmed = s.trim();
    let parsed = if let Some(secs) = trimmed.strip_suffix('s') {
        if let Some(ms) = secs.strip_suffix('m') {
            ms.parse::<u64>().ok().map(Duration::from_millis)
        } else {
            secs.parse::<u64>().ok().map(Duration::from_secs)
        }
    } else if let Some(mins) = trimmed.strip_suffix('m') {
        mins.parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        trimmed.parse::<u64>().ok().map(Duration::from_secs)
    };
    parsed.ok_or_else(|| HealthError::InvalidDuration(s.to_string()))
}

/// Render a duration in the shortest unit that represents it exactly.
pub fn format_duration(d: Duration) -> String {
    let ms = d.as_millis();
    if ms % 1000 != 0 {
        format!("{ms}ms")
    } else if ms >= 60_000 && ms % 60_000 == 0 {
        format!("{}m", ms / 60_000)
    } else {
        format!("{}s", ms / 1000)
    }
}

mod duration_str {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_duration(*d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_duration(&raw).map_err(de::Error::custom)
    }
}

mod opt_duration_str {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_str(&super::format_duration(*d)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        raw.map(|r| super::parse_duration(&r).map_err(de::Error::custom))
            .transpose()
    }
}
