//! The check engine: one run from sampling to a classified result.

use std::time::SystemTime;

use tracing::{debug, info, warn};

use crate::config::CheckConfig;
use crate::data::{CheckResult, DeltaCalculator, MetricRecord, Severity};
use crate::error::CheckError;
use crate::source::{
    CounterSource, LinkTypeProbe, LoadOutcome, PersistedState, Snapshot, StateStore, SysfsProbe,
};

/// Note for a run whose previous sample is too recent to compute a rate.
pub const INSUFFICIENT_ELAPSED: &str = "Insufficient elapsed time, skipping run.";

/// Note for a run without a previous sample.
pub const FIRST_RUN: &str = "First run.";

/// Note for a run that ends with no interface to report on.
pub const NO_DATA: &str = "No interface data, skipping run.";

/// A configured traffic check.
///
/// Every run loads the previous snapshot, saves the current one in its
/// place, and classifies the rate of every configured counter of every
/// selected interface.
pub struct Check {
    config: CheckConfig,
    store: StateStore,
    probe: Box<dyn LinkTypeProbe>,
    calculator: DeltaCalculator,
}

impl Check {
    /// Create a check using the host's sysfs for link types.
    pub fn new(config: CheckConfig) -> Self {
        let store = StateStore::new(&config.data_file);
        Self {
            config,
            store,
            probe: Box::new(SysfsProbe::default()),
            calculator: DeltaCalculator::native(),
        }
    }

    /// Replace the link type probe.
    pub fn with_probe(mut self, probe: Box<dyn LinkTypeProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn config(&self) -> &CheckConfig {
        &self.config
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Run the check now.
    pub fn run(&self, source: &mut dyn CounterSource) -> Result<CheckResult, CheckError> {
        self.run_at(source, SystemTime::now())
    }

    /// Run the check as if the wall clock read `now`.
    ///
    /// Recoverable problems (missing or corrupt state, failed save, unknown
    /// interface) end up as notes in the result. Errors are returned only
    /// when no meaningful result can be produced.
    pub fn run_at(
        &self,
        source: &mut dyn CounterSource,
        now: SystemTime,
    ) -> Result<CheckResult, CheckError> {
        let mut result = CheckResult::new(self.config.check_name());
        let mut current = source.sample()?;
        debug!("Sampled {}", source.description());

        let previous = self.load_previous(&mut result);

        if let Err(e) = self.store.save(&current) {
            warn!("Saving state failed: {:?}", e);
            result.escalate(Severity::Critical, e.to_string());
        }

        if !self.config.filter.is_empty() {
            let filtered = self
                .config
                .filter
                .apply(&mut current.interfaces, self.probe.as_ref());
            if let Err(missing) = filtered {
                result.escalate(Severity::Critical, missing.note());
            }
            debug!("{} interfaces selected", current.interfaces.len());
        }

        if let Some(previous) = previous {
            // A clock that went backwards counts as no elapsed time.
            let elapsed = now
                .duration_since(previous.saved_at)
                .map_or(0.0, |d| d.as_secs_f64());
            self.measure(&previous, &current, elapsed, &mut result)?;
        }

        if result.records.is_empty() && result.notes.is_empty() {
            debug!("No records and no problem reported");
            result.escalate(Severity::Unknown, NO_DATA);
        }

        Ok(result)
    }

    fn load_previous(&self, result: &mut CheckResult) -> Option<PersistedState> {
        match self.store.load() {
            LoadOutcome::Found(state) if state.snapshot.interfaces.is_empty() => {
                info!("No interfaces in {}", self.store.path().display());
                result.escalate(Severity::Unknown, FIRST_RUN);
                None
            }
            LoadOutcome::Found(state) => Some(state),
            LoadOutcome::NotFound => {
                info!("No previous data in {}", self.store.path().display());
                result.escalate(Severity::Unknown, FIRST_RUN);
                None
            }
            LoadOutcome::Corrupt(corruption) => {
                if let Err(e) = self.store.remove() {
                    warn!("{}", e);
                }
                result.escalate(Severity::Unknown, corruption.note());
                None
            }
        }
    }

    /// Add one record per (interface, counter) present in both snapshots.
    ///
    /// `elapsed` is the wall-clock time between the two samples in
    /// seconds; when it is not positive no rate can be computed and the
    /// run is reported UNKNOWN.
    pub fn measure(
        &self,
        previous: &PersistedState,
        current: &Snapshot,
        elapsed: f64,
        result: &mut CheckResult,
    ) -> Result<(), CheckError> {
        if elapsed.is_nan() || elapsed <= 0.0 {
            warn!("Elapsed time since the last run is {}s", elapsed);
            result.escalate(Severity::Unknown, INSUFFICIENT_ELAPSED);
            return Ok(());
        }

        let thresholds = self.config.thresholds();
        let unit = self.config.unit;

        for interface in current.interfaces.keys() {
            if !previous.snapshot.interfaces.contains_key(interface) {
                debug!("{} appeared since the last run", interface);
                continue;
            }

            for counter in &self.config.counters {
                let old = previous.snapshot.counter(interface, &counter.name);
                let new = current.counter(interface, &counter.name);
                let (Some(old), Some(new)) = (old, new) else {
                    debug!("{} has no {} counter", interface, counter.name);
                    continue;
                };

                let bytes = self
                    .calculator
                    .delta(old, previous.uptime, new, current.uptime)?;
                let rate = unit.convert(bytes as f64 / elapsed);

                result.add(MetricRecord {
                    label: counter.label(interface),
                    rate,
                    unit,
                    severity: thresholds.classify(rate),
                    warn: thresholds.warn_level(),
                    crit: thresholds.crit_level(),
                    min: 0.0,
                    max: thresholds.bandwidth,
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CounterSpec;
    use crate::data::{Unit, MAX_COUNTER};
    use crate::filter::InterfaceFilter;
    use crate::source::testing::FixedSource;
    use crate::source::LinkType;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    struct AllEthernet;

    impl LinkTypeProbe for AllEthernet {
        fn link_type(&self, _interface: &str) -> LinkType {
            LinkType::Ethernet
        }
    }

    fn config_in(dir: &TempDir) -> CheckConfig {
        CheckConfig {
            data_file: dir.path().join("traffic_stats.dat"),
            bandwidth: 10_000_000.0,
            warning: 90.0,
            critical: 98.0,
            ..Default::default()
        }
    }

    fn check(config: CheckConfig) -> Check {
        Check::new(config).with_probe(Box::new(AllEthernet))
    }

    fn snapshot(uptime: f64, rx: u64, tx: u64) -> Snapshot {
        Snapshot::new(uptime)
            .with_counter("eth0", "rx_bytes", rx)
            .with_counter("eth0", "tx_bytes", tx)
    }

    fn previous(snapshot: Snapshot) -> PersistedState {
        PersistedState {
            uptime: snapshot.uptime,
            saved_at: SystemTime::UNIX_EPOCH,
            snapshot,
        }
    }

    fn saved_at(check: &Check) -> SystemTime {
        fs::metadata(check.store().path()).unwrap().modified().unwrap()
    }

    #[test]
    fn test_first_run_is_unknown() {
        let dir = TempDir::new().unwrap();
        let check = check(config_in(&dir));

        let result = check.run(&mut FixedSource(snapshot(100.0, 5_000_000, 0))).unwrap();

        assert_eq!(result.severity, Severity::Unknown);
        assert!(result.notes.iter().any(|n| n.contains("First run")));
        assert!(result.records.is_empty());
        assert_eq!(result.exit_code(), 3);
        assert!(check.store().path().exists());
    }

    #[test]
    fn test_second_run_ten_seconds_later() {
        let dir = TempDir::new().unwrap();
        let check = check(config_in(&dir));

        check.run(&mut FixedSource(snapshot(100.0, 5_000_000, 0))).unwrap();
        let now = saved_at(&check) + Duration::from_secs(10);
        let result = check
            .run_at(&mut FixedSource(snapshot(110.0, 6_000_000, 0)), now)
            .unwrap();

        assert_eq!(result.severity, Severity::Ok);
        assert!(result.notes.is_empty());
        assert_eq!(result.records.len(), 2);

        let rx = &result.records[0];
        assert_eq!(rx.label, "in-eth0");
        assert_eq!(rx.rate, 100_000.0);
        assert_eq!(rx.severity, Severity::Ok);
        assert_eq!(rx.warn, 9_000_000.0);
        assert_eq!(rx.crit, 9_800_000.0);
        assert_eq!(rx.max, 10_000_000.0);

        assert_eq!(result.records[1].label, "out-eth0");
        assert_eq!(result.records[1].rate, 0.0);

        assert_eq!(
            result.to_string(),
            "Traffic Bps OK | in-eth0=100000.00;9000000;9800000;0;10000000 \
             out-eth0=0.00;9000000;9800000;0;10000000"
        );
    }

    #[test]
    fn test_threshold_severities() {
        let dir = TempDir::new().unwrap();
        let check = check(config_in(&dir));
        let prev = previous(snapshot(10.0, 0, 0));
        let mut result = CheckResult::new("Traffic Bps");

        // 10 seconds: rx 9.0 MB/s (warning), tx 9.8 MB/s (critical).
        check
            .measure(&prev, &snapshot(20.0, 90_000_000, 98_000_000), 10.0, &mut result)
            .unwrap();

        assert_eq!(result.records[0].severity, Severity::Warning);
        assert_eq!(result.records[1].severity, Severity::Critical);
        assert_eq!(result.severity, Severity::Critical);
        assert_eq!(result.exit_code(), 2);
    }

    #[test]
    fn test_rate_in_display_unit() {
        let dir = TempDir::new().unwrap();
        let config = CheckConfig {
            unit: "kbps".parse::<Unit>().unwrap(),
            bandwidth: 1_000.0,
            ..config_in(&dir)
        };
        let check = check(config);
        let prev = previous(snapshot(10.0, 0, 0));
        let mut result = CheckResult::new(check.config().check_name());

        // 125 000 B/s = 1 000 000 bit/s = 1000 kbps, at the ceiling.
        check
            .measure(&prev, &snapshot(12.0, 250_000, 0), 2.0, &mut result)
            .unwrap();

        assert_eq!(result.name, "Traffic kbps");
        assert_eq!(result.records[0].rate, 1000.0);
        assert_eq!(result.records[0].severity, Severity::Critical);
        assert_eq!(result.records[1].severity, Severity::Ok);
    }

    #[test]
    fn test_wraparound_and_reboot() {
        let dir = TempDir::new().unwrap();
        let check = check(config_in(&dir));
        let mut result = CheckResult::new("Traffic Bps");

        // Counter wrapped: MAX -> 9 is 10 bytes.
        let prev = previous(snapshot(10.0, MAX_COUNTER, 0));
        check
            .measure(&prev, &snapshot(11.0, 9, 0), 1.0, &mut result)
            .unwrap();
        assert_eq!(result.records[0].rate, 10.0);

        // Uptime went backwards: the new value is the delta.
        let prev = previous(snapshot(1_000.0, 5_000, 0));
        let mut result = CheckResult::new("Traffic Bps");
        check
            .measure(&prev, &snapshot(5.0, 400, 0), 4.0, &mut result)
            .unwrap();
        assert_eq!(result.records[0].rate, 100.0);
    }

    #[test]
    fn test_insufficient_elapsed_time() {
        let dir = TempDir::new().unwrap();
        let check = check(config_in(&dir));

        for elapsed in [0.0, -3.0, f64::NAN] {
            let mut result = CheckResult::new("Traffic Bps");
            check
                .measure(
                    &previous(snapshot(1.0, 0, 0)),
                    &snapshot(2.0, 10, 10),
                    elapsed,
                    &mut result,
                )
                .unwrap();
            assert_eq!(result.severity, Severity::Unknown);
            assert_eq!(result.notes, vec![INSUFFICIENT_ELAPSED.to_string()]);
            assert!(result.records.is_empty());
        }
    }

    #[test]
    fn test_clock_before_previous_save() {
        let dir = TempDir::new().unwrap();
        let check = check(config_in(&dir));

        check.run(&mut FixedSource(snapshot(100.0, 0, 0))).unwrap();
        let result = check
            .run_at(&mut FixedSource(snapshot(110.0, 10, 10)), SystemTime::UNIX_EPOCH)
            .unwrap();

        assert_eq!(result.severity, Severity::Unknown);
        assert_eq!(result.notes, vec![INSUFFICIENT_ELAPSED.to_string()]);
    }

    #[test]
    fn test_new_interfaces_and_missing_counters_are_skipped() {
        let dir = TempDir::new().unwrap();
        let config = CheckConfig {
            counters: vec![
                CounterSpec::new("rx_bytes", "in-"),
                CounterSpec::new("rx_packets", "pin-"),
            ],
            ..config_in(&dir)
        };
        let check = check(config);
        let prev = previous(snapshot(1.0, 0, 0));
        let current = snapshot(2.0, 10, 0)
            .with_counter("eth0", "rx_packets", 1)
            .with_counter("eth1", "rx_bytes", 10);
        let mut result = CheckResult::new("Traffic Bps");

        check.measure(&prev, &current, 1.0, &mut result).unwrap();

        let labels: Vec<&str> = result.records.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["in-eth0"]);
    }

    #[test]
    fn test_corrupt_state_is_replaced() {
        let dir = TempDir::new().unwrap();
        let check = check(config_in(&dir));
        fs::write(check.store().path(), "12.5\nInter-|   Receive |  Transmit\n").unwrap();

        let result = check.run(&mut FixedSource(snapshot(100.0, 0, 0))).unwrap();

        assert_eq!(result.severity, Severity::Unknown);
        assert_eq!(result.notes, vec!["Data file upgrade, skipping run.".to_string()]);
        assert!(result.records.is_empty());
        assert!(matches!(check.store().load(), LoadOutcome::Found(_)));
    }

    #[test]
    fn test_truncated_state_is_replaced() {
        let dir = TempDir::new().unwrap();
        let check = check(config_in(&dir));
        fs::write(check.store().path(), "12.5\n").unwrap();

        let result = check.run(&mut FixedSource(snapshot(100.0, 0, 0))).unwrap();

        assert_eq!(result.severity, Severity::Unknown);
        assert_eq!(result.notes, vec!["Malformed data file, skipping run.".to_string()]);
    }

    #[test]
    fn test_write_failure_still_measures() {
        let dir = TempDir::new().unwrap();
        let check = check(config_in(&dir));

        check.run(&mut FixedSource(snapshot(100.0, 0, 0))).unwrap();
        let now = saved_at(&check) + Duration::from_secs(10);
        // A directory in place of the temporary file makes the save fail.
        fs::create_dir(dir.path().join("traffic_stats.dat.tmp")).unwrap();

        let result = check
            .run_at(&mut FixedSource(snapshot(110.0, 1_000, 0)), now)
            .unwrap();

        assert_eq!(result.severity, Severity::Critical);
        assert_eq!(result.notes.len(), 1);
        assert!(result.notes[0].starts_with("Cannot write in "));
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.records[0].rate, 100.0);
    }

    #[test]
    fn test_unknown_device_discards_all_data() {
        let dir = TempDir::new().unwrap();
        let mut config = config_in(&dir);
        config.filter = InterfaceFilter {
            include: vec!["eth9".to_string()],
            ..Default::default()
        };
        let check = check(config);

        check.run(&mut FixedSource(snapshot(100.0, 0, 0))).unwrap();
        let now = saved_at(&check) + Duration::from_secs(10);
        let result = check
            .run_at(&mut FixedSource(snapshot(110.0, 1_000, 0)), now)
            .unwrap();

        assert_eq!(result.severity, Severity::Critical);
        assert_eq!(result.notes, vec!["Device eth9 not found.".to_string()]);
        assert!(result.records.is_empty());

        // The state file keeps every interface regardless of the filter.
        let LoadOutcome::Found(state) = check.store().load() else {
            panic!("expected saved state");
        };
        assert!(state.snapshot.interfaces.contains_key("eth0"));
    }

    #[test]
    fn test_non_finite_uptime_is_fatal() {
        let dir = TempDir::new().unwrap();
        let check = check(config_in(&dir));
        let mut result = CheckResult::new("Traffic Bps");
        let prev = previous(snapshot(f64::NAN, 0, 0));

        let err = check
            .measure(&prev, &snapshot(1.0, 1, 1), 1.0, &mut result)
            .unwrap_err();
        assert!(matches!(err, CheckError::NonNumericInput(_)));
    }

    #[test]
    fn test_state_without_interfaces_counts_as_first_run() {
        let dir = TempDir::new().unwrap();
        let check = check(config_in(&dir));
        fs::write(check.store().path(), "42\ninterface\n").unwrap();
        let now = saved_at(&check) + Duration::from_secs(10);

        let result = check
            .run_at(&mut FixedSource(snapshot(110.0, 1_000, 0)), now)
            .unwrap();

        assert_eq!(result.severity, Severity::Unknown);
        assert_eq!(result.notes, vec![FIRST_RUN.to_string()]);
        assert!(result.records.is_empty());
        assert_eq!(result.to_string(), "Traffic Bps UNKNOWN: First run. |");

        let LoadOutcome::Found(state) = check.store().load() else {
            panic!("expected saved state");
        };
        assert!(state.snapshot.interfaces.contains_key("eth0"));
    }

    #[test]
    fn test_everything_filtered_out_is_unknown() {
        let dir = TempDir::new().unwrap();
        let mut config = config_in(&dir);
        config.filter = InterfaceFilter {
            link_types: vec![LinkType::Loopback],
            ..Default::default()
        };
        let check = check(config);

        check.run(&mut FixedSource(snapshot(100.0, 0, 0))).unwrap();
        let now = saved_at(&check) + Duration::from_secs(10);
        let result = check
            .run_at(&mut FixedSource(snapshot(110.0, 1_000, 0)), now)
            .unwrap();

        assert_eq!(result.severity, Severity::Unknown);
        assert_eq!(result.notes, vec![NO_DATA.to_string()]);
        assert!(result.records.is_empty());
        assert_eq!(result.exit_code(), 3);
    }
}
