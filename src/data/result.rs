//! Check result aggregation and plugin output.

use std::fmt;

use serde::Serialize;

use super::threshold::Severity;
use super::unit::Unit;

/// One measured rate with its classification and perfdata levels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRecord {
    pub label: String,
    pub rate: f64,
    pub unit: Unit,
    pub severity: Severity,
    pub warn: f64,
    pub crit: f64,
    pub min: f64,
    pub max: f64,
}

impl fmt::Display for MetricRecord {
    /// Perfdata field: `label=value;warn;crit;min;max`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}={:.2};{};{};{};{}",
            self.label, self.rate, self.warn, self.crit, self.min, self.max
        )
    }
}

/// Outcome of one check run.
///
/// Starts OK; every added record and every escalation can only make the
/// overall severity worse.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResult {
    pub name: String,
    pub severity: Severity,
    pub notes: Vec<String>,
    pub records: Vec<MetricRecord>,
}

impl CheckResult {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            severity: Severity::Ok,
            notes: Vec::new(),
            records: Vec::new(),
        }
    }

    /// Append a record and fold its severity into the overall one.
    pub fn add(&mut self, record: MetricRecord) {
        self.severity = self.severity.worst(record.severity);
        self.records.push(record);
    }

    /// Record a problem note and raise the overall severity to at least
    /// `severity`.
    pub fn escalate(&mut self, severity: Severity, note: impl Into<String>) {
        self.severity = self.severity.worst(severity);
        self.notes.push(note.into());
    }

    pub fn exit_code(&self) -> u8 {
        self.severity.exit_code()
    }

    /// Number of records at each severity, as `(ok, warning, critical)`.
    pub fn counts(&self) -> (usize, usize, usize) {
        let count = |s: Severity| self.records.iter().filter(|r| r.severity == s).count();
        (
            count(Severity::Ok),
            count(Severity::Warning),
            count(Severity::Critical),
        )
    }
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.severity)?;
        if !self.notes.is_empty() {
            write!(f, ": {}", self.notes.join(" "))?;
        }
        f.write_str(" |")?;
        for record in &self.records {
            write!(f, " {}", record)?;
        }
        Ok(())
    }
}
