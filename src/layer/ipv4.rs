use std::net::Ipv4Addr;

use pnet::packet::ip::IpNextHeaderProtocol;
use pnet::packet::ipv4::{checksum, Ipv4Packet, MutableIpv4Packet};

use crate::error::SerializeError;

/// IPv4 header fields. Options are not modeled — no scenario in this
/// harness's scope needs them, mirroring the teacher's own "We currently
/// don't support options" shortcut in `Ipv4Builder::build`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Ipv4Fields {
    pub src: Option<Ipv4Addr>,
    pub dst: Option<Ipv4Addr>,
    pub protocol: Option<IpNextHeaderProtocol>,
    pub id: Option<u16>,
    pub ttl: Option<u8>,
    pub total_length: Option<u16>,
    pub checksum: Option<u16>,
}

impl Ipv4Fields {
    pub const HEADER_LEN: usize = 20;

    pub fn merge(&mut self, other: &Ipv4Fields) {
        if other.src.is_some() {
            self.src = other.src;
        }
        if other.dst.is_some() {
            self.dst = other.dst;
        }
        if other.protocol.is_some() {
            self.protocol = other.protocol;
        }
        if other.id.is_some() {
            self.id = other.id;
        }
        if other.ttl.is_some() {
            self.ttl = other.ttl;
        }
        if other.total_length.is_some() {
            self.total_length = other.total_length;
        }
        if other.checksum.is_some() {
            self.checksum = other.checksum;
        }
    }

    pub fn field_matches(&self, observed: &Ipv4Fields) -> bool {
        (self.src.is_none() || self.src == observed.src)
            && (self.dst.is_none() || self.dst == observed.dst)
            && (self.protocol.is_none() || self.protocol == observed.protocol)
            && (self.id.is_none() || self.id == observed.id)
            && (self.ttl.is_none() || self.ttl == observed.ttl)
            && (self.total_length.is_none() || self.total_length == observed.total_length)
            && (self.checksum.is_none() || self.checksum == observed.checksum)
    }

    pub fn diff_lines(&self, observed: &Ipv4Fields) -> Vec<String> {
        let mut lines = Vec::new();
        macro_rules! check {
            ($field:ident, $name:expr) => {
                if let Some(want) = self.$field {
                    if Some(want) != observed.$field {
                        lines.push(format!("{}: got {:?}, want {:?}", $name, observed.$field, want));
                    }
                }
            };
        }
        check!(src, "Ipv4Src");
        check!(dst, "Ipv4Dst");
        check!(protocol, "Ipv4Protocol");
        check!(id, "Ipv4Id");
        check!(ttl, "Ipv4Ttl");
        check!(total_length, "Ipv4TotalLength");
        check!(checksum, "Ipv4Checksum");
        lines
    }

    pub fn write(&self, region: &mut [u8], next_hint: Option<IpNextHeaderProtocol>) -> Result<(), SerializeError> {
        if region.len() > u16::MAX as usize {
            return Err(SerializeError { message: "ipv4 packet exceeds 65535 bytes".into() });
        }
        let mut pkg = MutableIpv4Packet::new(region)
            .ok_or_else(|| SerializeError { message: "buffer too small for an ipv4 header".into() })?;
        pkg.set_version(4);
        pkg.set_header_length(5); // no options
        pkg.set_dscp(0);
        pkg.set_ecn(0);
        pkg.set_identification(self.id.unwrap_or(0));
        pkg.set_flags(0);
        pkg.set_fragment_offset(0);
        pkg.set_ttl(self.ttl.unwrap_or(64));
        let protocol = self
            .protocol
            .or(next_hint)
            .ok_or_else(|| SerializeError { message: "ipv4 next_level_protocol is unspecified".into() })?;
        pkg.set_next_level_protocol(protocol);
        let src = self.src.ok_or_else(|| SerializeError { message: "ipv4 source is unspecified".into() })?;
        let dst = self.dst.ok_or_else(|| SerializeError { message: "ipv4 destination is unspecified".into() })?;
        pkg.set_source(src);
        pkg.set_destination(dst);
        let total_length = self.total_length.unwrap_or(region.len() as u16);
        pkg.set_total_length(total_length);
        let computed = self.checksum.unwrap_or_else(|| checksum(&pkg.to_immutable()));
        pkg.set_checksum(computed);
        Ok(())
    }

    pub fn parse(pkg: &Ipv4Packet) -> Ipv4Fields {
        Ipv4Fields {
            src: Some(pkg.get_source()),
            dst: Some(pkg.get_destination()),
            protocol: Some(pkg.get_next_level_protocol()),
            id: Some(pkg.get_identification()),
            ttl: Some(pkg.get_ttl()),
            total_length: Some(pkg.get_total_length()),
            checksum: Some(pkg.get_checksum()),
        }
    }
}
