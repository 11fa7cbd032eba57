//! Probe specifications: which protocol and port to check on every target.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Port used when a specification does not name one.
pub const DEFAULT_PORT: &str = "1";

/// Protocol used by the diagnostic tool.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Protocol {
    Icmp,
    Tcp,
    Udp,
}

impl Protocol {
    /// Command line flag selecting this protocol in `mtr`.
    ///
    /// ICMP is the tool's default and maps to an empty flag.
    pub fn tool_flag(&self) -> &'static str {
        match self {
            Self::Icmp => "",
            Self::Tcp => "--tcp",
            Self::Udp => "--udp",
        }
    }
}

/// One (protocol, port) pair checked against every target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProbeSpec {
    pub protocol: Protocol,
    pub port: String,
}

impl ProbeSpec {
    pub fn new(protocol: Protocol, port: impl Into<String>) -> Self {
        Self {
            protocol,
            port: port.into(),
        }
    }

    pub fn tool_flag(&self) -> &'static str {
        self.protocol.tool_flag()
    }

    /// Parse a single `PROTOCOL[:PORT]` entry.
    ///
    /// Returns `None` when the protocol is not one of `ICMP`, `TCP`, `UDP`.
    pub fn parse(entry: &str) -> Option<Self> {
        let mut parts = entry.trim().splitn(2, ':');
        let protocol = parts.next()?.parse::<Protocol>().ok()?;
        let port = match parts.next() {
            Some(port) if !port.is_empty() => port.to_string(),
            _ => DEFAULT_PORT.to_string(),
        };
        Some(Self::new(protocol, port))
    }
}

impl std::fmt::Display for ProbeSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.protocol, self.port)
    }
}

/// Immutable set of probe specifications, resolved once at startup.
pub type ProbeSpecs = Arc<[ProbeSpec]>;

/// Parse a comma-separated list such as `ICMP,TCP:80,UDP:53`.
///
/// Unsupported entries are skipped with a warning.
pub fn parse_probe_specs(input: &str) -> ProbeSpecs {
    input
        .trim()
        .split(',')
        .filter(|entry| !entry.trim().is_empty())
        .filter_map(|entry| {
            let spec = ProbeSpec::parse(entry);
            if spec.is_none() {
                tracing::warn!(entry = %entry, "Skip incorrect or unsupported protocol");
            }
            spec
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_default_port() {
        let spec = ProbeSpec::parse("ICMP").unwrap();
        assert_eq!(spec.protocol, Protocol::Icmp);
        assert_eq!(spec.port, DEFAULT_PORT);
        assert_eq!(spec.tool_flag(), "");
    }

    #[test]
    fn test_parse_with_port() {
        let spec = ProbeSpec::parse("TCP:8080").unwrap();
        assert_eq!(spec.protocol, Protocol::Tcp);
        assert_eq!(spec.port, "8080");
        assert_eq!(spec.tool_flag(), "--tcp");
    }

    #[test]
    fn test_parse_unknown_protocol() {
        assert!(ProbeSpec::parse("SCTP:1").is_none());
        assert!(ProbeSpec::parse("icmp").is_none());
    }

    #[test]
    fn test_parse_probe_specs_skips_invalid() {
        let specs = parse_probe_specs("ICMP, UDP:53,HTTP:80,TCP:443");
        assert_eq!(
            specs.as_ref(),
            &[
                ProbeSpec::new(Protocol::Icmp, "1"),
                ProbeSpec::new(Protocol::Udp, "53"),
                ProbeSpec::new(Protocol::Tcp, "443"),
            ]
        );
    }

    #[test]
    fn test_parse_probe_specs_empty() {
        assert!(parse_probe_specs("").is_empty());
        assert!(parse_probe_specs(" , ").is_empty());
    }

    #[test]
    fn test_protocol_display() {
        assert_eq!(Protocol::Udp.to_string(), "UDP");
        assert_eq!(ProbeSpec::new(Protocol::Tcp, "22").to_string(), "TCP:22");
    }
}
