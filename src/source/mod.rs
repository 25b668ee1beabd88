//! Counter sources and the persisted state of the previous run.
//!
//! This module provides a trait-based abstraction for sampling interface
//! counters, the procfs implementation, link type detection, and the
//! [`StateStore`] that carries a snapshot from one run to the next.

mod linktype;
mod procfs;
mod snapshot;
mod state;

pub use linktype::{LinkType, LinkTypeProbe, SysfsProbe};
pub use procfs::ProcSource;
pub use snapshot::{parse_net_dev, InterfaceCounters, Snapshot};
pub use state::{Corruption, LoadOutcome, PersistedState, StateStore};

use std::fmt::Debug;

use crate::error::CheckError;

/// Trait for sampling raw interface counters.
///
/// # Example
///
/// ```no_run
/// use iftraffic_check::{CounterSource, ProcSource};
///
/// let mut source = ProcSource::new();
/// let snapshot = source.sample()?;
/// println!("{} interfaces at uptime {}", snapshot.interfaces.len(), snapshot.uptime);
/// # Ok::<(), iftraffic_check::CheckError>(())
/// ```
pub trait CounterSource: Debug {
    /// Take one snapshot of every interface's counters.
    fn sample(&mut self) -> Result<Snapshot, CheckError>;

    /// Returns a human-readable description of the source.
    fn description(&self) -> &str;
}
