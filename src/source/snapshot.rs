//! Counter snapshot types and the `/proc/net/dev` parser.

use std::collections::BTreeMap;

/// Raw counters of one interface, keyed by counter name (`rx_bytes`, ...).
pub type InterfaceCounters = BTreeMap<String, u64>;

/// Counters of every interface, taken in a single read, plus the host
/// uptime at sample time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    /// Host uptime in seconds.
    pub uptime: f64,
    /// Counters keyed by interface name.
    pub interfaces: BTreeMap<String, InterfaceCounters>,
}

impl Snapshot {
    pub fn new(uptime: f64) -> Self {
        Self {
            uptime,
            interfaces: BTreeMap::new(),
        }
    }

    /// Builder-style helper to add one counter.
    pub fn with_counter(mut self, interface: &str, counter: &str, value: u64) -> Self {
        self.interfaces
            .entry(interface.to_string())
            .or_default()
            .insert(counter.to_string(), value);
        self
    }

    /// Raw value of `counter` on `interface`, if both exist.
    pub fn counter(&self, interface: &str, counter: &str) -> Option<u64> {
        self.interfaces.get(interface)?.get(counter).copied()
    }

    /// Union of the counter names of all interfaces, sorted.
    pub fn counter_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .interfaces
            .values()
            .flat_map(|counters| counters.keys().map(String::as_str))
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

/// Parse the content of `/proc/net/dev`.
///
/// The second header line names the columns; receive titles get an `rx_`
/// prefix and transmit titles a `tx_` prefix:
///
/// ```text
/// Inter-|   Receive                            |  Transmit
///  face |bytes    packets errs drop fifo ...   |bytes    packets errs ...
///     lo:  123456     789    0    0    0 ...
/// ```
pub fn parse_net_dev(content: &str) -> Result<BTreeMap<String, InterfaceCounters>, String> {
    let mut lines = content.lines();
    lines.next().ok_or("missing header")?;
    let titles = lines.next().ok_or("missing column titles")?;

    let sections: Vec<&str> = titles.split('|').collect();
    let [_, rx, tx] = sections.as_slice() else {
        return Err(format!("unexpected column titles: {:?}", titles.trim()));
    };
    let columns: Vec<String> = rx
        .split_whitespace()
        .map(|t| format!("rx_{}", t))
        .chain(tx.split_whitespace().map(|t| format!("tx_{}", t)))
        .collect();

    let mut interfaces = BTreeMap::new();
    for line in lines {
        let Some((name, values)) = line.split_once(':') else {
            continue;
        };
        let values = values
            .split_whitespace()
            .map(|v| {
                v.parse::<u64>()
                    .map_err(|e| format!("{}: {:?}: {}", name.trim(), v, e))
            })
            .collect::<Result<Vec<u64>, String>>()?;
        let counters = columns.iter().cloned().zip(values).collect();
        interfaces.insert(name.trim().to_string(), counters);
    }

    Ok(interfaces)
}

#[cfg(test)]
pub(crate) const SAMPLE_NET_DEV: &str = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo:  912840    8712    0    0    0     0          0         0   912840    8712    0    0    0     0       0          0
  eth0: 1803401212 1402213    0   12    0     0          0      1022 294016721  803311    0    0    0     0       0          0
wlan0:       0       0    0    0    0     0          0         0        0       0    0    0    0     0       0          0
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_net_dev() {
        let interfaces = parse_net_dev(SAMPLE_NET_DEV).unwrap();
        assert_eq!(interfaces.len(), 3);

        let eth0 = interfaces.get("eth0").unwrap();
        assert_eq!(eth0.len(), 16);
        assert_eq!(eth0["rx_bytes"], 1_803_401_212);
        assert_eq!(eth0["rx_drop"], 12);
        assert_eq!(eth0["rx_multicast"], 1022);
        assert_eq!(eth0["tx_bytes"], 294_016_721);
        assert_eq!(eth0["tx_packets"], 803_311);

        assert_eq!(interfaces["lo"]["tx_bytes"], 912_840);
        assert_eq!(interfaces["wlan0"]["rx_bytes"], 0);
    }

    #[test]
    fn test_parse_net_dev_rejects_garbage() {
        assert!(parse_net_dev("").is_err());
        assert!(parse_net_dev("only one line\n").is_err());
        assert!(parse_net_dev("a\nno pipes here\n").is_err());

        let bad_value = "h\n face |bytes|bytes\n eth0: 12 x\n";
        let err = parse_net_dev(bad_value).unwrap_err();
        assert!(err.contains("eth0"));
    }

    #[test]
    fn test_snapshot_helpers() {
        let snapshot = Snapshot::new(10.0)
            .with_counter("eth0", "rx_bytes", 5)
            .with_counter("eth0", "tx_bytes", 7)
            .with_counter("lo", "rx_packets", 1);

        assert_eq!(snapshot.counter("eth0", "tx_bytes"), Some(7));
        assert_eq!(snapshot.counter("eth0", "rx_packets"), None);
        assert_eq!(snapshot.counter("eth1", "rx_bytes"), None);
        assert_eq!(snapshot.counter_names(), vec!["rx_bytes", "rx_packets", "tx_bytes"]);
    }
}
