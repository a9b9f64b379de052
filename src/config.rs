use std::{net::SocketAddr, path::PathBuf, time::Duration};

use crate::sink::QueueBound;

/// Everything the daemon needs, resolved once at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub interfaces: Vec<String>,
    pub log_destination: LogDestination,
    pub store_path: PathBuf,
    /// How long a capture read may block before the worker re-checks for shutdown.
    pub read_timeout: Duration,
    pub queue_bound: QueueBound,
    pub metrics_addr: Option<SocketAddr>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogDestination {
    Stderr,
    File(PathBuf),
}

impl LogDestination {
    /// `-` selects standard error, anything else is a file path.
    pub fn from_arg(arg: &str) -> Self {
        match arg {
            "-" => LogDestination::Stderr,
            path => LogDestination::File(PathBuf::from(path)),
        }
    }

    pub fn is_stderr(&self) -> bool {
        matches!(self, LogDestination::Stderr)
    }
}

/// Splits a comma-separated interface list, e.g. `eth0,wlan0`.
pub fn parse_interfaces(list: &str) -> Result<Vec<String>, String> {
    let mut interfaces: Vec<String> = Vec::new();
    for name in list.split(',').map(str::trim) {
        if name.is_empty() {
            return Err(format!("empty interface name in {:?}", list));
        }
        if !interfaces.iter().any(|known| known == name) {
            interfaces.push(name.to_string());
        }
    }
    Ok(interfaces)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interface_list() {
        assert_eq!(parse_interfaces("eth0").unwrap(), vec!["eth0"]);
        assert_eq!(parse_interfaces("eth0, wlan0,eth0").unwrap(), vec!["eth0", "wlan0"]);
        assert!(parse_interfaces("eth0,,wlan0").is_err());
        assert!(parse_interfaces("").is_err());
    }

    #[test]
    fn log_destination() {
        assert_eq!(LogDestination::from_arg("-"), LogDestination::Stderr);
        assert_eq!(LogDestination::from_arg("/var/log/arpwatch.log"), LogDestination::File("/var/log/arpwatch.log".into()));
        assert!(LogDestination::from_arg("-").is_stderr());
    }
}
