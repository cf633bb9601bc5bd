use pnet::packet::ethernet::{EtherType, EtherTypes, MutableEthernetPacket};
use pnet::util::MacAddr;

use crate::error::SerializeError;

/// Ethernet header fields. Every field is optional: present means "must
/// equal this" (expect) or "emit this" (send); absent means wildcard
/// (expect) or "compute a default" (send). spec.md §3, §4.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EtherFields {
    pub src: Option<MacAddr>,
    pub dst: Option<MacAddr>,
    pub ether_type: Option<EtherType>,
}

impl EtherFields {
    pub const HEADER_LEN: usize = 14;

    pub fn merge(&mut self, other: &EtherFields) {
        if other.src.is_some() {
            self.src = other.src;
        }
        if other.dst.is_some() {
            self.dst = other.dst;
        }
        if other.ether_type.is_some() {
            self.ether_type = other.ether_type;
        }
    }

    pub fn field_matches(&self, observed: &EtherFields) -> bool {
        (self.src.is_none() || self.src == observed.src)
            && (self.dst.is_none() || self.dst == observed.dst)
            && (self.ether_type.is_none() || self.ether_type == observed.ether_type)
    }

    pub fn diff_lines(&self, observed: &EtherFields) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(want) = self.src {
            if Some(want) != observed.src {
                lines.push(format!("EtherSrc: got {:?}, want {}", observed.src, want));
            }
        }
        if let Some(want) = self.dst {
            if Some(want) != observed.dst {
                lines.push(format!("EtherDst: got {:?}, want {}", observed.dst, want));
            }
        }
        if let Some(want) = self.ether_type {
            if Some(want) != observed.ether_type {
                lines.push(format!("EtherType: got {:?}, want {:?}", observed.ether_type, want));
            }
        }
        lines
    }

    /// Writes this layer's header into `region`. `next_hint` is the
    /// ethertype implied by the layer that follows (e.g. `Ipv4` when the
    /// next layer is an IPv4 layer), used to compute the default when
    /// `ether_type` itself is unspecified.
    pub fn write(&self, region: &mut [u8], next_hint: Option<EtherType>) -> Result<(), SerializeError> {
        let mut pkg = MutableEthernetPacket::new(region)
            .ok_or_else(|| SerializeError { message: "buffer too small for an ethernet header".into() })?;
        let src = self
            .src
            .ok_or_else(|| SerializeError { message: "ethernet source MAC is unspecified".into() })?;
        let dst = self
            .dst
            .ok_or_else(|| SerializeError { message: "ethernet destination MAC is unspecified".into() })?;
        pkg.set_source(src);
        pkg.set_destination(dst);
        pkg.set_ethertype(self.ether_type.or(next_hint).unwrap_or(EtherTypes::Ipv4));
        Ok(())
    }

    pub fn parse(pkg: &pnet::packet::ethernet::EthernetPacket) -> EtherFields {
        EtherFields {
            src: Some(pkg.get_source()),
            dst: Some(pkg.get_destination()),
            ether_type: Some(pkg.get_ethertype()),
        }
    }
}
