//! Kernel counter source.
//!
//! Reads interface counters from `/proc/net/dev` and the host uptime from
//! `/proc/uptime`.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::snapshot::parse_net_dev;
use super::{CounterSource, Snapshot};
use crate::error::CheckError;

const NET_DEV: &str = "/proc/net/dev";
const UPTIME: &str = "/proc/uptime";

/// A counter source backed by procfs.
#[derive(Debug)]
pub struct ProcSource {
    net_dev: PathBuf,
    uptime: PathBuf,
    description: String,
}

impl Default for ProcSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcSource {
    /// Source reading the running kernel's procfs.
    pub fn new() -> Self {
        Self::with_paths(NET_DEV, UPTIME)
    }

    /// Source reading the given files instead of the real procfs.
    pub fn with_paths<P: AsRef<Path>, Q: AsRef<Path>>(net_dev: P, uptime: Q) -> Self {
        let net_dev = net_dev.as_ref().to_path_buf();
        let description = format!("procfs: {}", net_dev.display());
        Self {
            net_dev,
            uptime: uptime.as_ref().to_path_buf(),
            description,
        }
    }

    fn read(path: &Path) -> Result<String, CheckError> {
        fs::read_to_string(path).map_err(|source| CheckError::Read {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Host uptime in seconds: the first field of `/proc/uptime`.
    fn read_uptime(&self) -> Result<f64, CheckError> {
        let content = Self::read(&self.uptime)?;
        let parse_error = |message: String| CheckError::Parse {
            path: self.uptime.clone(),
            message,
        };
        let field = content
            .split_whitespace()
            .next()
            .ok_or_else(|| parse_error("empty file".to_string()))?;
        let uptime: f64 = field
            .parse()
            .map_err(|e| parse_error(format!("{:?}: {}", field, e)))?;
        if !uptime.is_finite() {
            return Err(CheckError::NonNumericInput(format!("uptime {:?}", field)));
        }
        Ok(uptime)
    }
}

impl CounterSource for ProcSource {
    fn sample(&mut self) -> Result<Snapshot, CheckError> {
        let content = Self::read(&self.net_dev)?;
        let uptime = self.read_uptime()?;
        let interfaces = parse_net_dev(&content).map_err(|message| CheckError::Parse {
            path: self.net_dev.clone(),
            message,
        })?;
        debug!("Sampled {} interfaces at uptime {}", interfaces.len(), uptime);
        Ok(Snapshot { uptime, interfaces })
    }

    fn description(&self) -> &str {
        &self.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::snapshot::SAMPLE_NET_DEV;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn file_with(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_proc_source_samples_files() {
        let net_dev = file_with(SAMPLE_NET_DEV);
        let uptime = file_with("35212.71 130019.33\n");

        let mut source = ProcSource::with_paths(net_dev.path(), uptime.path());
        let snapshot = source.sample().unwrap();

        assert_eq!(snapshot.uptime, 35212.71);
        assert_eq!(snapshot.interfaces.len(), 3);
        assert_eq!(snapshot.counter("eth0", "rx_bytes"), Some(1_803_401_212));
        assert!(source.description().starts_with("procfs: "));
    }

    #[test]
    fn test_proc_source_missing_file() {
        let uptime = file_with("1.0 1.0\n");
        let mut source = ProcSource::with_paths("/nonexistent/net/dev", uptime.path());
        let err = source.sample().unwrap_err();
        assert!(matches!(err, CheckError::Read { .. }));
    }

    #[test]
    fn test_proc_source_bad_uptime() {
        let net_dev = file_with(SAMPLE_NET_DEV);

        let uptime = file_with("soon 1.0\n");
        let mut source = ProcSource::with_paths(net_dev.path(), uptime.path());
        assert!(matches!(source.sample(), Err(CheckError::Parse { .. })));

        let uptime = file_with("NaN 1.0\n");
        let mut source = ProcSource::with_paths(net_dev.path(), uptime.path());
        assert!(matches!(source.sample(), Err(CheckError::NonNumericInput(_))));
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_proc_source_reads_real_procfs() {
        let mut source = ProcSource::new();
        let snapshot = source.sample().unwrap();
        assert!(snapshot.uptime > 0.0);
    }
}
