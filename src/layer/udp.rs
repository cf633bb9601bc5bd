use std::net::Ipv4Addr;

use pnet::packet::udp::{self, MutableUdpPacket, UdpPacket};

use crate::error::SerializeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UdpFields {
    pub src_port: Option<u16>,
    pub dst_port: Option<u16>,
    pub length: Option<u16>,
    pub checksum: Option<u16>,
}

impl UdpFields {
    pub const HEADER_LEN: usize = 8;

    pub fn merge(&mut self, other: &UdpFields) {
        if other.src_port.is_some() {
            self.src_port = other.src_port;
        }
        if other.dst_port.is_some() {
            self.dst_port = other.dst_port;
        }
        if other.length.is_some() {
            self.length = other.length;
        }
        if other.checksum.is_some() {
            self.checksum = other.checksum;
        }
    }

    pub fn field_matches(&self, observed: &UdpFields) -> bool {
        (self.src_port.is_none() || self.src_port == observed.src_port)
            && (self.dst_port.is_none() || self.dst_port == observed.dst_port)
            && (self.length.is_none() || self.length == observed.length)
            && (self.checksum.is_none() || self.checksum == observed.checksum)
    }

    pub fn diff_lines(&self, observed: &UdpFields) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(want) = self.src_port {
            if Some(want) != observed.src_port {
                lines.push(format!("SrcPort: got {:?}, want {}", observed.src_port, want));
            }
        }
        if let Some(want) = self.dst_port {
            if Some(want) != observed.dst_port {
                lines.push(format!("DstPort: got {:?}, want {}", observed.dst_port, want));
            }
        }
        if let Some(want) = self.length {
            if Some(want) != observed.length {
                lines.push(format!("Length: got {:?}, want {}", observed.length, want));
            }
        }
        if let Some(want) = self.checksum {
            if Some(want) != observed.checksum {
                lines.push(format!("Checksum: got {:?}, want {}", observed.checksum, want));
            }
        }
        lines
    }

    pub fn write(&self, region: &mut [u8], src_ip: Ipv4Addr, dst_ip: Ipv4Addr) -> Result<(), SerializeError> {
        let mut pkg = MutableUdpPacket::new(region)
            .ok_or_else(|| SerializeError { message: "buffer too small for a udp header".into() })?;
        let src_port = self.src_port.ok_or_else(|| SerializeError { message: "udp source port is unspecified".into() })?;
        let dst_port = self
            .dst_port
            .ok_or_else(|| SerializeError { message: "udp destination port is unspecified".into() })?;
        pkg.set_source(src_port);
        pkg.set_destination(dst_port);
        let length = self.length.unwrap_or(region.len() as u16);
        pkg.set_length(length);
        let computed = self
            .checksum
            .unwrap_or_else(|| udp::ipv4_checksum(&pkg.to_immutable(), &src_ip, &dst_ip));
        pkg.set_checksum(computed);
        Ok(())
    }

    pub fn parse(pkg: &UdpPacket) -> UdpFields {
        UdpFields {
            src_port: Some(pkg.get_source()),
            dst_port: Some(pkg.get_destination()),
            length: Some(pkg.get_length()),
            checksum: Some(pkg.get_checksum()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_overlays_specified_fields_only() {
        let mut a = UdpFields { src_port: Some(1), dst_port: None, length: None, checksum: None };
        let b = UdpFields { src_port: Some(2), dst_port: Some(53), length: None, checksum: None };
        a.merge(&b);
        assert_eq!(a.src_port, Some(2));
        assert_eq!(a.dst_port, Some(53));
        assert_eq!(a.length, None);
    }

    #[test]
    fn wildcard_field_matches_anything() {
        let wildcard = UdpFields::default();
        let observed = UdpFields { src_port: Some(1234), dst_port: Some(53), length: Some(16), checksum: Some(0xbeef) };
        assert!(wildcard.field_matches(&observed));
    }

    #[test]
    fn specified_field_must_equal() {
        let want = UdpFields { dst_port: Some(53), ..Default::default() };
        let observed = UdpFields { dst_port: Some(54), ..Default::default() };
        assert!(!want.field_matches(&observed));
    }

    #[test]
    fn diff_lines_names_mismatched_field() {
        let want = UdpFields { dst_port: Some(53), ..Default::default() };
        let observed = UdpFields { dst_port: Some(54), ..Default::default() };
        let lines = want.diff_lines(&observed);
        assert!(lines.iter().any(|l| l == "DstPort: got Some(54), want 53"), "{:?}", lines);
    }
}
