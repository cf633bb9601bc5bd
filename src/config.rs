//! Immutable harness configuration, passed by value into every connection
//! factory instead of being read from globals inside layer constructors
//! (spec.md §9 "Global harness state"). Parsing the flag values themselves
//! (argv, env, ...) is left to the embedding test harness, which is
//! explicitly out of scope for this crate (spec.md §1).

use std::net::Ipv4Addr;
use std::str::FromStr;

use pnet::util::MacAddr;

use crate::error::ConfigError;

/// The local/remote IPv4 and MAC endpoints every layer state derives its
/// fixed fields from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub local_ipv4: Ipv4Addr,
    pub remote_ipv4: Ipv4Addr,
    pub local_mac: MacAddr,
    pub remote_mac: MacAddr,
}

impl Config {
    /// Parses dotted-quad IPv4 addresses and colon-separated MAC addresses,
    /// the textual form harness flags deliver them in.
    pub fn new(
        local_ipv4: &str,
        remote_ipv4: &str,
        local_mac: &str,
        remote_mac: &str,
    ) -> Result<Config, ConfigError> {
        Ok(Config {
            local_ipv4: Ipv4Addr::from_str(local_ipv4)?,
            remote_ipv4: Ipv4Addr::from_str(remote_ipv4)?,
            local_mac: parse_mac(local_mac)?,
            remote_mac: parse_mac(remote_mac)?,
        })
    }
}

fn parse_mac(s: &str) -> Result<MacAddr, ConfigError> {
    MacAddr::from_str(s).map_err(|e| ConfigError::InvalidAddress(format!("{}: {}", s, e)))
}
