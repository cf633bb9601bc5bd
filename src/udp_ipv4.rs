//! UDP/IPv4 factory (spec.md §2 row 4, scenario S6): thinner than
//! `tcp_ipv4` because UDP carries no sequencing, so no façade state needs
//! sharing beyond what `Connection` already owns.

use std::time::Duration;

use pnet::packet::ip::IpNextHeaderProtocols;

use crate::config::Config;
use crate::connection::Connection;
use crate::error::ConnError;
use crate::io::{Injector, Sniffer};
use crate::layer::{Layer, Layers, UdpFields};
use crate::state::{EtherState, Ipv4State, LayerState, UdpState};

pub struct UdpIpv4Connection<I: Injector, S: Sniffer> {
    conn: Connection<I, S>,
    local_port: u16,
}

pub fn new_udp_ipv4<I: Injector, S: Sniffer>(
    config: &Config,
    remote_port: u16,
    injector: I,
    sniffer: S,
) -> Result<UdpIpv4Connection<I, S>, ConnError> {
    let udp_state = UdpState::new(config, remote_port)?;
    let local_port = udp_state.local_port();
    let layer_states: Vec<Box<dyn LayerState>> = vec![
        Box::new(EtherState::new(config)),
        Box::new(Ipv4State::new(config, IpNextHeaderProtocols::Udp)),
        Box::new(udp_state),
    ];
    Ok(UdpIpv4Connection { conn: Connection::new(layer_states, injector, sniffer), local_port })
}

impl<I: Injector, S: Sniffer> UdpIpv4Connection<I, S> {
    pub fn local_port(&self) -> u16 {
        self.local_port
    }

    pub fn send(&mut self, udp: UdpFields, extras: &[Layer]) -> Result<(), ConnError> {
        let overrides = Layers::new(vec![Layer::Ether(Default::default()), Layer::Ipv4(Default::default()), Layer::Udp(udp)]);
        let frame = self.conn.create_frame(&overrides, extras)?;
        self.conn.send_frame(&frame)
    }

    pub fn expect(&mut self, udp: UdpFields, timeout: Duration) -> Result<UdpFields, ConnError> {
        let expected = Layers::new(vec![Layer::Ether(Default::default()), Layer::Ipv4(Default::default()), Layer::Udp(udp)]);
        let matched = self.conn.expect_frame(&expected, timeout)?;
        matched.get(2).and_then(Layer::as_udp).cloned().ok_or(ConnError::ProtocolMismatch)
    }

    pub fn close(&mut self) -> Result<(), ConnError> {
        self.conn.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::testing::{ChannelInjector, ChannelSniffer};

    fn config() -> Config {
        Config::new("192.0.2.1", "192.0.2.2", "02:00:00:00:00:01", "02:00:00:00:00:02").unwrap()
    }

    #[test]
    fn two_connections_reserve_distinct_local_ports() {
        let (i1, _) = ChannelInjector::new();
        let (s1, _) = ChannelSniffer::new();
        let (i2, _) = ChannelInjector::new();
        let (s2, _) = ChannelSniffer::new();

        let conn1 = new_udp_ipv4(&config(), 53, i1, s1).unwrap();
        let conn2 = new_udp_ipv4(&config(), 53, i2, s2).unwrap();

        assert_ne!(conn1.local_port(), conn2.local_port());
    }

    #[test]
    fn send_produces_nonempty_bytes() {
        let (injector, rx) = ChannelInjector::new();
        let (sniffer, _tx) = ChannelSniffer::new();
        let mut conn = new_udp_ipv4(&config(), 53, injector, sniffer).unwrap();
        conn.send(UdpFields::default(), &[]).unwrap();
        assert!(!rx.recv().unwrap().is_empty());
    }
}
