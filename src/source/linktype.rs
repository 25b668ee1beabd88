//! Hardware link type detection.
//!
//! The kernel exposes the ARPHRD family of every interface in
//! `/sys/class/net/<iface>/type`, the same number `SIOCGIFHWADDR` returns.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::debug;

const SYS_CLASS_NET: &str = "/sys/class/net";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkType {
    Ethernet,
    Ppp,
    Loopback,
    Sit,
    Unspecified,
    Unknown,
}

impl LinkType {
    /// Map an ARPHRD family number to a link type.
    pub fn from_family(family: u16) -> Self {
        match family {
            1 => LinkType::Ethernet,
            512 => LinkType::Ppp,
            772 => LinkType::Loopback,
            776 => LinkType::Sit,
            0xfffe => LinkType::Unspecified,
            _ => LinkType::Unknown,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LinkType::Ethernet => "ethernet",
            LinkType::Ppp => "ppp",
            LinkType::Loopback => "loopback",
            LinkType::Sit => "sit",
            LinkType::Unspecified => "unspecified",
            LinkType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LinkType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            LinkType::Ethernet,
            LinkType::Ppp,
            LinkType::Loopback,
            LinkType::Sit,
            LinkType::Unspecified,
            LinkType::Unknown,
        ]
        .into_iter()
        .find(|t| t.name() == s)
        .ok_or_else(|| format!("unknown link type {:?}", s))
    }
}

/// Looks up the link type of an interface.
pub trait LinkTypeProbe {
    fn link_type(&self, interface: &str) -> LinkType;
}

/// Probe reading `/sys/class/net`.
#[derive(Debug, Clone)]
pub struct SysfsProbe {
    root: PathBuf,
}

impl Default for SysfsProbe {
    fn default() -> Self {
        Self::new(SYS_CLASS_NET)
    }
}

impl SysfsProbe {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl LinkTypeProbe for SysfsProbe {
    fn link_type(&self, interface: &str) -> LinkType {
        let path = self.root.join(interface).join("type");
        match fs::read_to_string(&path)
            .ok()
            .and_then(|s| s.trim().parse::<u16>().ok())
        {
            Some(family) => LinkType::from_family(family),
            None => {
                debug!("No link type for {} at {}", interface, path.display());
                LinkType::Unknown
            }
        }
    }
}
