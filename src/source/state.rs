//! Persisted counter state.
//!
//! The previous run's snapshot is kept in a small text file:
//!
//! ```text
//! 35212.71
//! interface rx_bytes tx_bytes
//! eth0 1803401212 294016721
//! lo 912840 912840
//! ```
//!
//! Line 1 is the host uptime at save time, line 2 the table header, then
//! one row per interface. A counter an interface does not have is written
//! as `-`. The file's modification time tells when it was written.

use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, warn};

use super::Snapshot;
use crate::error::StateError;

/// First word of the table header; files without it predate this format.
const TABLE_MARKER: &str = "interface";

/// Placeholder for a counter an interface does not have.
const MISSING: &str = "-";

/// The previous run's data.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedState {
    /// Host uptime recorded when the file was written.
    pub uptime: f64,
    /// Modification time of the file.
    pub saved_at: SystemTime,
    pub snapshot: Snapshot,
}

/// Why a state file could not be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Corruption {
    /// Written by an older release in a different layout.
    Legacy(String),
    /// Truncated or otherwise damaged.
    Malformed(String),
    /// The file exists but cannot be read.
    Unreadable(String),
}

impl Corruption {
    /// Note reported to the user for this run.
    pub fn note(&self) -> &'static str {
        match self {
            Corruption::Legacy(_) => "Data file upgrade, skipping run.",
            Corruption::Malformed(_) => "Malformed data file, skipping run.",
            Corruption::Unreadable(_) => "Unreadable data file, skipping run.",
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            Corruption::Legacy(d) | Corruption::Malformed(d) | Corruption::Unreadable(d) => d,
        }
    }
}

/// Result of [`StateStore::load`].
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Found(PersistedState),
    /// No state file: expected on the first run.
    NotFound,
    Corrupt(Corruption),
}

/// Reads and writes the state file.
///
/// No locking is done: two concurrent runs on the same path may interleave
/// their load and save.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the previous snapshot.
    pub fn load(&self) -> LoadOutcome {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return LoadOutcome::NotFound,
            Err(e) => return LoadOutcome::Corrupt(Corruption::Unreadable(e.to_string())),
        };

        let saved_at = match fs::metadata(&self.path).and_then(|m| m.modified()) {
            Ok(time) => time,
            Err(e) => return LoadOutcome::Corrupt(Corruption::Unreadable(e.to_string())),
        };

        match parse_state(&content) {
            Ok(snapshot) => {
                debug!(
                    "Loaded {} interfaces from {}",
                    snapshot.interfaces.len(),
                    self.path.display()
                );
                LoadOutcome::Found(PersistedState {
                    uptime: snapshot.uptime,
                    saved_at,
                    snapshot,
                })
            }
            Err(corruption) => {
                warn!("Ignoring {}: {}", self.path.display(), corruption.detail());
                LoadOutcome::Corrupt(corruption)
            }
        }
    }

    /// Replace the state file with `snapshot`.
    ///
    /// The content goes to a sibling temporary file first and is renamed
    /// over the target, so an interrupted write never leaves half a table.
    pub fn save(&self, snapshot: &Snapshot) -> Result<(), StateError> {
        let write_error = |source: io::Error| StateError::Write {
            path: self.path.clone(),
            source,
        };

        let mut tmp_name = self.path.as_os_str().to_os_string();
        tmp_name.push(".tmp");
        let tmp = PathBuf::from(tmp_name);

        fs::write(&tmp, render_state(snapshot)).map_err(write_error)?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(write_error(e));
        }
        debug!(
            "Saved {} interfaces to {}",
            snapshot.interfaces.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Delete the state file. A file that is already gone is not an error.
    pub fn remove(&self) -> Result<(), StateError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StateError::Remove {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

fn render_state(snapshot: &Snapshot) -> String {
    let columns = snapshot.counter_names();

    let mut lines = vec![snapshot.uptime.to_string()];
    lines.push(
        std::iter::once(TABLE_MARKER)
            .chain(columns.iter().copied())
            .collect::<Vec<_>>()
            .join(" "),
    );

    for (name, counters) in &snapshot.interfaces {
        let row: Vec<String> = std::iter::once(name.clone())
            .chain(columns.iter().map(|column| match counters.get(*column) {
                Some(value) => value.to_string(),
                None => MISSING.to_string(),
            }))
            .collect();
        lines.push(row.join(" "));
    }

    lines.push(String::new());
    lines.join("\n")
}

fn parse_state(content: &str) -> Result<Snapshot, Corruption> {
    let mut lines = content.lines();

    let (Some(first), Some(header)) = (lines.next(), lines.next()) else {
        return Err(Corruption::Malformed("fewer than 2 lines".to_string()));
    };

    let not_an_uptime = || Corruption::Legacy(format!("first line is not an uptime: {:?}", first));
    let uptime: f64 = first.trim().parse().map_err(|_| not_an_uptime())?;
    if !uptime.is_finite() {
        return Err(not_an_uptime());
    }

    let mut header = header.split_whitespace();
    if header.next() != Some(TABLE_MARKER) {
        return Err(Corruption::Legacy("missing table header".to_string()));
    }
    let columns: Vec<&str> = header.collect();

    let mut snapshot = Snapshot::new(uptime);
    for (index, line) in lines.enumerate() {
        let mut fields = line.split_whitespace();
        let Some(name) = fields.next() else {
            continue;
        };
        let values: Vec<&str> = fields.collect();
        if values.len() != columns.len() {
            return Err(Corruption::Malformed(format!(
                "row {} has {} values, expected {}",
                index + 1,
                values.len(),
                columns.len()
            )));
        }

        let counters = snapshot.interfaces.entry(name.to_string()).or_default();
        for (column, value) in columns.iter().zip(values) {
            if value == MISSING {
                continue;
            }
            let value: u64 = value.parse().map_err(|_| {
                let detail = format!("{} {}: not a counter: {:?}", name, column, value);
                Corruption::Malformed(detail)
            })?;
            counters.insert(column.to_string(), value);
        }
    }

    Ok(snapshot)
}
