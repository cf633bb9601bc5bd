use std::net::Ipv4Addr;

use pnet::packet::tcp::{self, MutableTcpPacket, TcpFlags, TcpPacket};

use crate::error::SerializeError;

/// TCP header fields. `flags` is the raw 8-bit flag byte (set bits named by
/// `pnet::packet::tcp::TcpFlags`, combined with `|` the same way the example
/// pack's hand rolled packet builders do).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TcpFields {
    pub src_port: Option<u16>,
    pub dst_port: Option<u16>,
    pub seq_num: Option<u32>,
    pub ack_num: Option<u32>,
    pub flags: Option<u8>,
    pub window: Option<u16>,
    pub checksum: Option<u16>,
    pub urgent_ptr: Option<u16>,
}

impl TcpFields {
    pub const HEADER_LEN: usize = 20;

    pub fn merge(&mut self, other: &TcpFields) {
        if other.src_port.is_some() {
            self.src_port = other.src_port;
        }
        if other.dst_port.is_some() {
            self.dst_port = other.dst_port;
        }
        if other.seq_num.is_some() {
            self.seq_num = other.seq_num;
        }
        if other.ack_num.is_some() {
            self.ack_num = other.ack_num;
        }
        if other.flags.is_some() {
            self.flags = other.flags;
        }
        if other.window.is_some() {
            self.window = other.window;
        }
        if other.checksum.is_some() {
            self.checksum = other.checksum;
        }
        if other.urgent_ptr.is_some() {
            self.urgent_ptr = other.urgent_ptr;
        }
    }

    pub fn field_matches(&self, observed: &TcpFields) -> bool {
        (self.src_port.is_none() || self.src_port == observed.src_port)
            && (self.dst_port.is_none() || self.dst_port == observed.dst_port)
            && (self.seq_num.is_none() || self.seq_num == observed.seq_num)
            && (self.ack_num.is_none() || self.ack_num == observed.ack_num)
            && (self.flags.is_none() || self.flags == observed.flags)
            && (self.window.is_none() || self.window == observed.window)
            && (self.checksum.is_none() || self.checksum == observed.checksum)
            && (self.urgent_ptr.is_none() || self.urgent_ptr == observed.urgent_ptr)
    }

    pub fn diff_lines(&self, observed: &TcpFields) -> Vec<String> {
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
        if let Some(want) = self.seq_num {
            if Some(want) != observed.seq_num {
                lines.push(format!("SeqNum: got {:?}, want {}", observed.seq_num, want));
            }
        }
        if let Some(want) = self.ack_num {
            if Some(want) != observed.ack_num {
                lines.push(format!("AckNum: got {:?}, want {}", observed.ack_num, want));
            }
        }
        if let Some(want) = self.flags {
            if Some(want) != observed.flags {
                let got_str = observed.flags.map(format_flags).unwrap_or_else(|| "none".to_owned());
                lines.push(format!("Flags: got {}, want {}", got_str, format_flags(want)));
            }
        }
        if let Some(want) = self.window {
            if Some(want) != observed.window {
                lines.push(format!("Window: got {:?}, want {}", observed.window, want));
            }
        }
        if let Some(want) = self.checksum {
            if Some(want) != observed.checksum {
                lines.push(format!("Checksum: got {:?}, want {}", observed.checksum, want));
            }
        }
        if let Some(want) = self.urgent_ptr {
            if Some(want) != observed.urgent_ptr {
                lines.push(format!("UrgentPtr: got {:?}, want {}", observed.urgent_ptr, want));
            }
        }
        lines
    }

    pub fn write(&self, region: &mut [u8], src_ip: Ipv4Addr, dst_ip: Ipv4Addr) -> Result<(), SerializeError> {
        let mut pkg = MutableTcpPacket::new(region)
            .ok_or_else(|| SerializeError { message: "buffer too small for a tcp header".into() })?;
        let src_port = self.src_port.ok_or_else(|| SerializeError { message: "tcp source port is unspecified".into() })?;
        let dst_port = self
            .dst_port
            .ok_or_else(|| SerializeError { message: "tcp destination port is unspecified".into() })?;
        pkg.set_source(src_port);
        pkg.set_destination(dst_port);
        pkg.set_sequence(self.seq_num.unwrap_or(0));
        pkg.set_acknowledgement(self.ack_num.unwrap_or(0));
        pkg.set_data_offset(5); // no options
        pkg.set_reserved(0);
        pkg.set_flags(self.flags.unwrap_or(0));
        pkg.set_window(self.window.unwrap_or(65535));
        pkg.set_urgent_ptr(self.urgent_ptr.unwrap_or(0));
        let computed = self
            .checksum
            .unwrap_or_else(|| tcp::ipv4_checksum(&pkg.to_immutable(), &src_ip, &dst_ip));
        pkg.set_checksum(computed);
        Ok(())
    }

    pub fn parse(pkg: &TcpPacket) -> TcpFields {
        TcpFields {
            src_port: Some(pkg.get_source()),
            dst_port: Some(pkg.get_destination()),
            seq_num: Some(pkg.get_sequence()),
            ack_num: Some(pkg.get_acknowledgement()),
            flags: Some(pkg.get_flags()),
            window: Some(pkg.get_window()),
            checksum: Some(pkg.get_checksum()),
            urgent_ptr: Some(pkg.get_urgent_ptr()),
        }
    }

    pub fn has_syn(&self) -> bool {
        self.flags.map(|f| f & TcpFlags::SYN != 0).unwrap_or(false)
    }

    pub fn has_fin(&self) -> bool {
        self.flags.map(|f| f & TcpFlags::FIN != 0).unwrap_or(false)
    }

    pub fn has_ack(&self) -> bool {
        self.flags.map(|f| f & TcpFlags::ACK != 0).unwrap_or(false)
    }
}

fn format_flags(flags: u8) -> String {
    const NAMED: &[(u8, &str)] = &[
        (TcpFlags::FIN, "FIN"),
        (TcpFlags::SYN, "SYN"),
        (TcpFlags::RST, "RST"),
        (TcpFlags::PSH, "PSH"),
        (TcpFlags::ACK, "ACK"),
        (TcpFlags::URG, "URG"),
        (TcpFlags::ECE, "ECE"),
        (TcpFlags::CWR, "CWR"),
    ];
    let set: Vec<&str> = NAMED
        .iter()
        .filter(|(bit, _)| flags & bit != 0)
        .map(|(_, name)| *name)
        .collect();
    if set.is_empty() {
        "none".to_owned()
    } else {
        set.join("|")
    }
}
