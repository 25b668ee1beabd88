//! # iftraffic-check
//!
//! A monitoring plugin and library that reports network interface throughput
//! against a bandwidth ceiling.
//!
//! Every invocation samples the kernel interface counters, compares them with
//! the sample saved by the previous invocation, and prints a Nagios-style
//! status line with perfdata. The only memory between runs is a small state
//! file.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                             Check                                │
//! │  ┌─────────┐   ┌────────────┐   ┌──────────┐   ┌──────────────┐  │
//! │  │ source  │──▶│   filter   │──▶│   data   │──▶│ CheckResult  │  │
//! │  │(sample) │   │(interfaces)│   │(delta,   │   │(text, JSON,  │  │
//! │  └────┬────┘   └────────────┘   │ unit,    │   │ exit code)   │  │
//! │       │                         │ classify)│   └──────────────┘  │
//! │       ▼                         └────▲─────┘                     │
//! │  ┌──────────┐   previous snapshot    │                           │
//! │  │StateStore│────────────────────────┘                           │
//! │  └──────────┘                                                    │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`app`]**: The [`Check`] engine running one invocation
//! - **[`source`]**: The [`CounterSource`] trait, the procfs implementation,
//!   link type detection, and the [`StateStore`]
//! - **[`filter`]**: Interface selection by name, pattern and link type
//! - **[`data`]**: Counter deltas, unit conversion, thresholds and the
//!   aggregated [`CheckResult`]
//! - **[`config`]**: Layered [`Settings`] and the validated [`CheckConfig`]
//!
//! ## Usage
//!
//! ### As a plugin
//!
//! ```bash
//! # 1 Gbit link, warn at 85%, critical at 98%, report in Mbps
//! check-iftraffic --unit Mbps --bandwidth 1000 -x lo
//! ```
//!
//! ### As a library
//!
//! ```no_run
//! use iftraffic_check::{Check, CheckConfig, ProcSource};
//!
//! let check = Check::new(CheckConfig::default());
//! let result = check.run(&mut ProcSource::new())?;
//! println!("{}", result);
//! std::process::exit(result.exit_code().into());
//! # Ok::<(), iftraffic_check::CheckError>(())
//! ```
//!
//! ## Known limitations
//!
//! The state file is not locked. Two invocations racing on the same file can
//! interleave their load and save, which skews the computed rates.

pub mod app;
pub mod config;
pub mod data;
pub mod error;
pub mod filter;
pub mod source;

// Re-export main types for convenience
pub use app::Check;
pub use config::{CheckConfig, CounterSpec, Settings};
pub use data::{
    classify, convert, delta, CheckResult, MetricRecord, Severity, Thresholds, Unit,
    UnitParseError,
};
pub use error::{CheckError, StateError};
pub use filter::InterfaceFilter;
pub use source::{
    CounterSource, LinkType, LoadOutcome, PersistedState, ProcSource, Snapshot, StateStore,
};
