//! Interface selection.
//!
//! Narrows the interfaces of the current snapshot down to the ones the
//! check reports on.

use std::collections::BTreeMap;

use regex::Regex;
use tracing::debug;

use crate::error::CheckError;
use crate::source::{LinkType, LinkTypeProbe};

/// A requested interface does not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceNotFound(pub String);

impl DeviceNotFound {
    pub fn note(&self) -> String {
        format!("Device {} not found.", self.0)
    }
}

/// Which interfaces to report on.
///
/// `include`, `exclude` and `exclude_patterns` are mutually exclusive; see
/// [`InterfaceFilter::validate`].
#[derive(Debug, Clone, Default)]
pub struct InterfaceFilter {
    /// Only these interfaces (all when empty).
    pub include: Vec<String>,
    /// Drop interfaces with these names.
    pub exclude: Vec<String>,
    /// Drop interfaces whose name matches, anchored at the start.
    pub exclude_patterns: Vec<Regex>,
    /// Only interfaces of these link types (all when empty).
    pub link_types: Vec<LinkType>,
}

impl InterfaceFilter {
    /// Compile exclusion patterns. Like a prefix match, a pattern only
    /// matches from the first character of the name.
    pub fn compile_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<Regex>, CheckError> {
        patterns
            .iter()
            .map(|pattern| {
                let pattern = pattern.as_ref();
                Regex::new(&format!("^(?:{})", pattern)).map_err(|source| {
                    CheckError::Pattern {
                        pattern: pattern.to_string(),
                        source,
                    }
                })
            })
            .collect()
    }

    /// Reject filters combining inclusion and exclusion.
    pub fn validate(&self) -> Result<(), CheckError> {
        let modes = [
            !self.include.is_empty(),
            !self.exclude.is_empty(),
            !self.exclude_patterns.is_empty(),
        ];
        if modes.iter().filter(|set| **set).count() > 1 {
            return Err(CheckError::Config(
                "interfaces, exclude and excludere are mutually exclusive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty()
            && self.exclude.is_empty()
            && self.exclude_patterns.is_empty()
            && self.link_types.is_empty()
    }

    /// Remove unwanted interfaces from `interfaces`.
    ///
    /// Exclusions run first, then the link type filter, then the inclusion
    /// list. If an included interface does not exist, every interface is
    /// removed and the missing name is returned.
    pub fn apply<V>(
        &self,
        interfaces: &mut BTreeMap<String, V>,
        probe: &dyn LinkTypeProbe,
    ) -> Result<(), DeviceNotFound> {
        for name in &self.exclude {
            interfaces.remove(name);
        }

        if !self.exclude_patterns.is_empty() {
            interfaces.retain(|name, _| {
                !self.exclude_patterns.iter().any(|re| re.is_match(name))
            });
        }

        if !self.link_types.is_empty() {
            interfaces.retain(|name, _| {
                let link_type = probe.link_type(name);
                let keep = self.link_types.contains(&link_type);
                if !keep {
                    debug!("Skipping {} ({})", name, link_type);
                }
                keep
            });
        }

        if !self.include.is_empty() {
            let missing = self
                .include
                .iter()
                .find(|name| !interfaces.contains_key(*name));
            if let Some(missing) = missing {
                interfaces.clear();
                return Err(DeviceNotFound(missing.clone()));
            }
            interfaces.retain(|name, _| self.include.contains(name));
        }

        Ok(())
    }
}
