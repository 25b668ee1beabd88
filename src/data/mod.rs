//! Rate computation and classification.
//!
//! This module turns two raw counter readings into a classified metric.
//!
//! ## Submodules
//!
//! - [`delta`]: Counter differences across wraparound and reboots
//! - [`unit`]: Conversion of bytes/sec into decimal byte or bit units
//! - [`threshold`]: [`Severity`] and bandwidth [`Thresholds`]
//! - [`result`]: Aggregation into a [`CheckResult`] and plugin output
//!
//! ## Data Flow
//!
//! ```text
//! previous counter ─┐
//!                   ├──▶ delta() ──▶ / elapsed ──▶ Unit::convert() ──▶ Thresholds::classify()
//! current counter ──┘                                                          │
//!                                                                              ▼
//!                                                              CheckResult::add(MetricRecord)
//! ```

pub mod delta;
pub mod result;
pub mod threshold;
pub mod unit;

pub use delta::{delta, DeltaCalculator, MAX_COUNTER};
pub use result::{CheckResult, MetricRecord};
pub use threshold::{classify, Severity, Thresholds};
pub use unit::{convert, Unit, UnitParseError, UNIT_CHOICES};
