//! The layer value model (spec.md §3, §4.1): a uniform representation of
//! per-protocol header fields where any field may be unspecified (wildcard),
//! plus the operations (`merge`, `match`, `diff`, `to_bytes`, `parse`) that
//! `Layers` — an ordered outermost-first sequence of `Layer` — exposes.

pub mod ether;
pub mod ipv4;
pub mod payload;
pub mod tcp;
pub mod udp;

pub use ether::EtherFields;
pub use ipv4::Ipv4Fields;
pub use payload::PayloadFields;
pub use tcp::TcpFields;
pub use udp::UdpFields;

use std::net::Ipv4Addr;

use pnet::packet::ethernet::{EtherTypes, EthernetPacket};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::Ipv4Packet;
use pnet::packet::tcp::TcpPacket;
use pnet::packet::udp::UdpPacket;
use pnet::packet::Packet;

use crate::error::{MergeError, SerializeError};

/// One protocol header, or a trailing payload. spec.md GLOSSARY "Layer".
#[derive(Debug, Clone, PartialEq)]
pub enum Layer {
    Ether(EtherFields),
    Ipv4(Ipv4Fields),
    Tcp(TcpFields),
    Udp(UdpFields),
    Payload(PayloadFields),
}

impl Layer {
    fn variant_name(&self) -> &'static str {
        match self {
            Layer::Ether(_) => "Ether",
            Layer::Ipv4(_) => "Ipv4",
            Layer::Tcp(_) => "Tcp",
            Layer::Udp(_) => "Udp",
            Layer::Payload(_) => "Payload",
        }
    }

    /// Overlays every field specified in `other` onto `self`. Fails if the
    /// two layers are of different protocol variants.
    pub fn merge(&mut self, other: &Layer) -> Result<(), MergeError> {
        match (self, other) {
            (Layer::Ether(a), Layer::Ether(b)) => {
                a.merge(b);
                Ok(())
            }
            (Layer::Ipv4(a), Layer::Ipv4(b)) => {
                a.merge(b);
                Ok(())
            }
            (Layer::Tcp(a), Layer::Tcp(b)) => {
                a.merge(b);
                Ok(())
            }
            (Layer::Udp(a), Layer::Udp(b)) => {
                a.merge(b);
                Ok(())
            }
            (Layer::Payload(a), Layer::Payload(b)) => {
                a.merge(b);
                Ok(())
            }
            (a, b) => Err(MergeError {
                message: format!("cannot merge {} into {}", b.variant_name(), a.variant_name()),
            }),
        }
    }

    /// Field-wise equality restricted to fields specified in `self`.
    /// Different variants never match.
    pub fn matches(&self, observed: &Layer) -> bool {
        match (self, observed) {
            (Layer::Ether(a), Layer::Ether(b)) => a.field_matches(b),
            (Layer::Ipv4(a), Layer::Ipv4(b)) => a.field_matches(b),
            (Layer::Tcp(a), Layer::Tcp(b)) => a.field_matches(b),
            (Layer::Udp(a), Layer::Udp(b)) => a.field_matches(b),
            (Layer::Payload(a), Layer::Payload(b)) => a.field_matches(b),
            _ => false,
        }
    }

    pub fn diff_lines(&self, observed: &Layer) -> Vec<String> {
        match (self, observed) {
            (Layer::Ether(a), Layer::Ether(b)) => a.diff_lines(b),
            (Layer::Ipv4(a), Layer::Ipv4(b)) => a.diff_lines(b),
            (Layer::Tcp(a), Layer::Tcp(b)) => a.diff_lines(b),
            (Layer::Udp(a), Layer::Udp(b)) => a.diff_lines(b),
            (Layer::Payload(a), Layer::Payload(b)) => a.diff_lines(b),
            (a, b) => vec![format!("variant: got {}, want {}", b.variant_name(), a.variant_name())],
        }
    }

    fn header_len(&self) -> usize {
        match self {
            Layer::Ether(_) => EtherFields::HEADER_LEN,
            Layer::Ipv4(_) => Ipv4Fields::HEADER_LEN,
            Layer::Tcp(_) => TcpFields::HEADER_LEN,
            Layer::Udp(_) => UdpFields::HEADER_LEN,
            Layer::Payload(p) => p.len(),
        }
    }

    fn ether_type_hint(&self) -> Option<pnet::packet::ethernet::EtherType> {
        match self {
            Layer::Ipv4(_) => Some(EtherTypes::Ipv4),
            _ => None,
        }
    }

    fn ip_protocol_hint(&self) -> Option<pnet::packet::ip::IpNextHeaderProtocol> {
        match self {
            Layer::Tcp(_) => Some(IpNextHeaderProtocols::Tcp),
            Layer::Udp(_) => Some(IpNextHeaderProtocols::Udp),
            _ => None,
        }
    }

    pub fn as_tcp(&self) -> Option<&TcpFields> {
        match self {
            Layer::Tcp(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_udp(&self) -> Option<&UdpFields> {
        match self {
            Layer::Udp(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_payload(&self) -> Option<&PayloadFields> {
        match self {
            Layer::Payload(f) => Some(f),
            _ => None,
        }
    }
}

/// An ordered sequence of `Layer`, outermost first (Ether, IPv4, TCP,
/// Payload, ...). spec.md GLOSSARY "Layers".
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Layers(pub Vec<Layer>);

impl Layers {
    pub fn new(layers: Vec<Layer>) -> Layers {
        Layers(layers)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&Layer> {
        self.0.get(i)
    }

    /// Overlays `other` onto `self` at matching indices (testable property
    /// 1). `other` is free to be shorter than `self` — only the layers it
    /// specifies are merged; extra layers in `self` are left untouched. If
    /// `other` is longer, its extra layers are appended verbatim (this is
    /// how `CreateFrame` appends trailing payload layers).
    pub fn merge(&mut self, other: &Layers) -> Result<(), MergeError> {
        for (i, layer) in other.0.iter().enumerate() {
            match self.0.get_mut(i) {
                Some(existing) => existing.merge(layer)?,
                None => self.0.push(layer.clone()),
            }
        }
        Ok(())
    }

    /// True iff every specified field of `self` equals the corresponding
    /// field of `observed` at the same index, for the layers `self` has. An
    /// `observed` with fewer layers than `self` never matches (testable
    /// property 2, and spec.md's resolved open question on short frames).
    pub fn matches_prefix(&self, observed: &Layers) -> bool {
        if observed.0.len() < self.0.len() {
            return false;
        }
        self.0.iter().zip(observed.0.iter()).all(|(want, got)| want.matches(got))
    }

    /// A human readable field-wise diff against `observed`, used as the
    /// `Display` body of `LayersError`.
    pub fn diff(&self, observed: &Layers) -> String {
        let mut lines = Vec::new();
        for (i, want) in self.0.iter().enumerate() {
            match observed.0.get(i) {
                Some(got) => lines.extend(want.diff_lines(got)),
                None => lines.push(format!("layer {}: got nothing, want {}", i, want.variant_name())),
            }
        }
        if lines.is_empty() {
            "no differences".to_owned()
        } else {
            lines.join("\n")
        }
    }

    /// Serializes every layer into one contiguous byte buffer. Checksums and
    /// lengths left unspecified are computed, consulting neighbouring layers
    /// where needed (e.g. a TCP checksum needs the enclosing IPv4 source and
    /// destination).
    pub fn to_bytes(&self) -> Result<Vec<u8>, SerializeError> {
        let lens: Vec<usize> = self.0.iter().map(Layer::header_len).collect();
        let total: usize = lens.iter().sum();
        let mut buf = vec![0u8; total];
        let mut offsets = Vec::with_capacity(self.0.len());
        let mut offset = 0;
        for &len in &lens {
            offsets.push(offset);
            offset += len;
        }

        // Payload bytes are copied first: transport checksums need them
        // already in place even though Payload is typically the last layer.
        for (i, layer) in self.0.iter().enumerate() {
            if let Layer::Payload(p) = layer {
                if let Some(bytes) = &p.bytes {
                    let start = offsets[i];
                    buf[start..start + bytes.len()].copy_from_slice(bytes);
                }
            }
        }

        let ipv4_endpoints: Option<(Option<Ipv4Addr>, Option<Ipv4Addr>)> = self.0.iter().find_map(|l| match l {
            Layer::Ipv4(f) => Some((f.src, f.dst)),
            _ => None,
        });

        for (i, layer) in self.0.iter().enumerate() {
            let start = offsets[i];
            let region = &mut buf[start..];
            match layer {
                Layer::Ether(f) => {
                    let hint = self.0.get(i + 1).and_then(Layer::ether_type_hint);
                    f.write(region, hint)?;
                }
                Layer::Ipv4(f) => {
                    let hint = self.0.get(i + 1).and_then(Layer::ip_protocol_hint);
                    f.write(region, hint)?;
                }
                Layer::Tcp(f) => {
                    let (src, dst) = require_ipv4_endpoints(ipv4_endpoints, "tcp")?;
                    f.write(region, src, dst)?;
                }
                Layer::Udp(f) => {
                    let (src, dst) = require_ipv4_endpoints(ipv4_endpoints, "udp")?;
                    f.write(region, src, dst)?;
                }
                Layer::Payload(_) => {}
            }
        }

        Ok(buf)
    }

    /// Parses `bytes` into an ordered `Layers`, outermost first. Stops as
    /// soon as a layer fails to parse; any undecodable tail is surfaced as a
    /// single trailing `Payload` layer so a short/garbage frame (spec.md
    /// scenario S5) simply yields fewer layers than expected rather than
    /// erroring.
    pub fn parse(bytes: &[u8]) -> Layers {
        let mut layers = Vec::new();
        let eth = match EthernetPacket::new(bytes) {
            Some(p) => p,
            None => return Layers(layers),
        };
        layers.push(Layer::Ether(EtherFields::parse(&eth)));

        if eth.get_ethertype() == EtherTypes::Ipv4 {
            if let Some(ip) = Ipv4Packet::new(eth.payload()) {
                layers.push(Layer::Ipv4(Ipv4Fields::parse(&ip)));
                let ip_payload = ip.payload();
                match ip.get_next_level_protocol() {
                    IpNextHeaderProtocols::Tcp => {
                        if let Some(tcp_pkg) = TcpPacket::new(ip_payload) {
                            layers.push(Layer::Tcp(TcpFields::parse(&tcp_pkg)));
                            push_payload(&mut layers, tcp_pkg.payload());
                        }
                    }
                    IpNextHeaderProtocols::Udp => {
                        if let Some(udp_pkg) = UdpPacket::new(ip_payload) {
                            layers.push(Layer::Udp(UdpFields::parse(&udp_pkg)));
                            push_payload(&mut layers, udp_pkg.payload());
                        }
                    }
                    _ => push_payload(&mut layers, ip_payload),
                }
            }
        } else {
            push_payload(&mut layers, eth.payload());
        }

        Layers(layers)
    }
}

fn push_payload(layers: &mut Vec<Layer>, bytes: &[u8]) {
    if !bytes.is_empty() {
        layers.push(Layer::Payload(PayloadFields { bytes: Some(bytes.to_vec()) }));
    }
}

fn require_ipv4_endpoints(
    endpoints: Option<(Option<Ipv4Addr>, Option<Ipv4Addr>)>,
    proto: &str,
) -> Result<(Ipv4Addr, Ipv4Addr), SerializeError> {
    let (src, dst) = endpoints.ok_or_else(|| SerializeError {
        message: format!("{} layer requires an enclosing ipv4 layer", proto),
    })?;
    let src = src.ok_or_else(|| SerializeError { message: format!("{} checksum needs an ipv4 source", proto) })?;
    let dst = dst.ok_or_else(|| SerializeError { message: format!("{} checksum needs an ipv4 destination", proto) })?;
    Ok((src, dst))
}
