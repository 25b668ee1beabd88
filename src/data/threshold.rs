//! Severity levels and bandwidth threshold classification.

use std::fmt;

use serde::Serialize;

/// Severity of a metric or of the whole check.
///
/// Variants are declared best to worst, so `Ord` gives
/// `Critical > Warning > Unknown > Ok` and [`Severity::worst`] is `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    #[default]
    Ok,
    Unknown,
    Warning,
    Critical,
}

impl Severity {
    /// All severities, best first.
    pub const ALL: [Severity; 4] = [
        Severity::Ok,
        Severity::Unknown,
        Severity::Warning,
        Severity::Critical,
    ];

    /// The worse of two severities.
    pub fn worst(self, other: Severity) -> Severity {
        self.max(other)
    }

    /// Plugin exit code for this severity.
    pub fn exit_code(&self) -> u8 {
        match self {
            Severity::Ok => 0,
            Severity::Warning => 1,
            Severity::Critical => 2,
            Severity::Unknown => 3,
        }
    }

    /// Returns the upper-case label used in plugin output.
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Ok => "OK",
            Severity::Warning => "WARNING",
            Severity::Critical => "CRITICAL",
            Severity::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Bandwidth ceiling and the percentages of it that trigger alerts.
///
/// The levels are not required to be ordered; a warning percentage above
/// the critical one simply means WARNING is never reported.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    /// Maximum bandwidth, in the unit the rate is classified in.
    pub bandwidth: f64,
    /// Percentage of `bandwidth` that triggers a warning.
    pub warn_percent: f64,
    /// Percentage of `bandwidth` that triggers critical status.
    pub crit_percent: f64,
}

impl Thresholds {
    pub fn new(bandwidth: f64, warn_percent: f64, crit_percent: f64) -> Self {
        Self {
            bandwidth,
            warn_percent,
            crit_percent,
        }
    }

    pub fn warn_level(&self) -> f64 {
        self.bandwidth * self.warn_percent / 100.0
    }

    pub fn crit_level(&self) -> f64 {
        self.bandwidth * self.crit_percent / 100.0
    }

    pub fn classify(&self, rate: f64) -> Severity {
        if rate >= self.crit_level() {
            Severity::Critical
        } else if rate >= self.warn_level() {
            Severity::Warning
        } else {
            Severity::Ok
        }
    }
}

/// Classify `rate` against percentages of `ceiling`. Both boundaries are
/// inclusive.
pub fn classify(rate: f64, ceiling: f64, warn_percent: f64, crit_percent: f64) -> Severity {
    Thresholds::new(ceiling, warn_percent, crit_percent).classify(rate)
}
