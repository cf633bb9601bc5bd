//! TCP/IPv4 specialization (spec.md §4.4): a thin façade over `Connection`
//! adding `handshake`, typed `send`/`expect`/`expect_data`, and a
//! `remote_seq_num` accessor.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::tcp::TcpFlags;

use crate::config::Config;
use crate::connection::Connection;
use crate::error::ConnError;
use crate::io::{Injector, Sniffer};
use crate::layer::{Layer, Layers, PayloadFields, TcpFields};
use crate::seq::SeqNum;
use crate::state::{EtherState, Ipv4State, LayerState, TcpState};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(1);

/// Shares `TcpState` between the `Connection`'s layer-state vector and this
/// façade (both need `sent`/`received` to run against the same sequence
/// counters). `Rc<RefCell<_>>` rather than the teacher's `Arc<Mutex<_>>`:
/// spec.md §5 makes a `Connection` single-threaded, so there's no need for
/// cross-thread synchronization.
struct SharedTcpState(Rc<RefCell<TcpState>>);

impl LayerState for SharedTcpState {
    fn outgoing(&self) -> Layer {
        self.0.borrow().outgoing()
    }

    fn incoming(&self, observed: &Layer) -> Option<Layer> {
        self.0.borrow().incoming(observed)
    }

    fn sent(&mut self, actual: &Layer, trailing: &[Layer]) -> Result<(), crate::error::StateError> {
        self.0.borrow_mut().sent(actual, trailing)
    }

    fn received(&mut self, actual: &Layer, trailing: &[Layer]) -> Result<(), crate::error::StateError> {
        self.0.borrow_mut().received(actual, trailing)
    }

    fn close(&mut self) -> Result<(), crate::error::StateError> {
        self.0.borrow_mut().close()
    }
}

pub struct TcpIpv4Connection<I: Injector, S: Sniffer> {
    conn: Connection<I, S>,
    tcp_state: Rc<RefCell<TcpState>>,
}

/// Builds a `TcpIpv4Connection` talking to `remote_port` over `config`'s
/// endpoints, using `injector`/`sniffer` for the wire.
pub fn new_tcp_ipv4<I: Injector, S: Sniffer>(
    config: &Config,
    remote_port: u16,
    injector: I,
    sniffer: S,
) -> Result<TcpIpv4Connection<I, S>, ConnError> {
    let tcp_state = Rc::new(RefCell::new(TcpState::new(config, remote_port)?));
    let layer_states: Vec<Box<dyn LayerState>> = vec![
        Box::new(EtherState::new(config)),
        Box::new(Ipv4State::new(config, IpNextHeaderProtocols::Tcp)),
        Box::new(SharedTcpState(Rc::clone(&tcp_state))),
    ];
    let conn = Connection::new(layer_states, injector, sniffer);
    Ok(TcpIpv4Connection { conn, tcp_state })
}

impl<I: Injector, S: Sniffer> TcpIpv4Connection<I, S> {
    /// Sends a SYN; expects a SYN|ACK within one second (fatal on timeout);
    /// captures it; sends an ACK. After this call the test's view of the
    /// connection is ESTABLISHED (spec.md §4.4 — no TIME-WAIT modeling).
    pub fn handshake(&mut self) -> Result<(), ConnError> {
        debug!("handshake: sending SYN");
        self.send(TcpFields { flags: Some(TcpFlags::SYN), ..Default::default() }, &[])?;

        let syn_ack = self.expect_frame_typed(
            TcpFields { flags: Some(TcpFlags::SYN | TcpFlags::ACK), ..Default::default() },
            HANDSHAKE_TIMEOUT,
        )?;
        debug!("handshake: received SYN|ACK");
        self.tcp_state.borrow_mut().set_syn_ack(syn_ack);

        debug!("handshake: sending ACK");
        self.send(TcpFields { flags: Some(TcpFlags::ACK), ..Default::default() }, &[])?;
        Ok(())
    }

    /// Typed `send`: merges `tcp` into the connection's outgoing TCP
    /// template and appends `extras` (e.g. a `Payload`) before injecting.
    pub fn send(&mut self, tcp: TcpFields, extras: &[Layer]) -> Result<(), ConnError> {
        let overrides = Layers::new(vec![
            Layer::Ether(Default::default()),
            Layer::Ipv4(Default::default()),
            Layer::Tcp(tcp),
        ]);
        let frame = self.conn.create_frame(&overrides, extras)?;
        self.conn.send_frame(&frame)
    }

    /// Typed `expect`: merges `tcp` into the connection's incoming TCP
    /// expectation, waits up to `timeout`, and down-casts the result.
    /// Fatal (`ConnError::ProtocolMismatch`) if the matched layer is not
    /// TCP — that indicates a harness bug, not DUT behavior.
    pub fn expect(&mut self, tcp: TcpFields, timeout: Duration) -> Result<TcpFields, ConnError> {
        let matched = self.expect_frame_typed(tcp, timeout)?;
        matched
            .get(2)
            .and_then(Layer::as_tcp)
            .cloned()
            .ok_or(ConnError::ProtocolMismatch)
    }

    /// Like `expect`, but also requires a trailing `Payload` expectation.
    /// Returns the observed TCP fields and the observed payload bytes, if
    /// any.
    pub fn expect_data(
        &mut self,
        tcp: TcpFields,
        payload: Option<Vec<u8>>,
        timeout: Duration,
    ) -> Result<(TcpFields, Option<Vec<u8>>), ConnError> {
        let expected = Layers::new(vec![
            Layer::Ether(Default::default()),
            Layer::Ipv4(Default::default()),
            Layer::Tcp(tcp),
            Layer::Payload(PayloadFields { bytes: payload }),
        ]);
        let matched = self.conn.expect_frame(&expected, timeout)?;
        let tcp_fields = matched.get(2).and_then(Layer::as_tcp).cloned().ok_or(ConnError::ProtocolMismatch)?;
        let observed_payload = matched.get(3).and_then(Layer::as_payload).and_then(|p| p.bytes.clone());
        Ok((tcp_fields, observed_payload))
    }

    fn expect_frame_typed(&mut self, tcp: TcpFields, timeout: Duration) -> Result<Layers, ConnError> {
        let expected = Layers::new(vec![Layer::Ether(Default::default()), Layer::Ipv4(Default::default()), Layer::Tcp(tcp)]);
        self.conn.expect_frame(&expected, timeout)
    }

    pub fn remote_seq_num(&self) -> Option<SeqNum> {
        self.tcp_state.borrow().remote_seq_num()
    }

    pub fn local_seq_num(&self) -> SeqNum {
        self.tcp_state.borrow().local_seq_num()
    }

    pub fn local_port(&self) -> u16 {
        self.tcp_state.borrow().local_port()
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
    fn handshake_sends_syn_then_ack_and_captures_synack() {
        let (injector, sent) = ChannelInjector::new();
        let (sniffer, deliver) = ChannelSniffer::new();
        let mut tcp_conn = new_tcp_ipv4(&config(), 80, injector, sniffer).unwrap();

        let initial_local = tcp_conn.tcp_state.borrow().local_seq_num();

        // Respond to the SYN with a SYN|ACK once it's been sent.
        let responder = std::thread::spawn(move || {
            let syn_bytes = sent.recv().expect("syn sent");
            let syn = Layers::parse(&syn_bytes);
            let syn_seq = syn.get(2).and_then(Layer::as_tcp).and_then(|t| t.seq_num).unwrap();

            // The DUT's reply swaps endpoints relative to the SYN it just
            // received; it is not the SYN frame with only flags/seq/ack
            // touched up.
            let mut synack = syn;
            match &mut synack.0[0] {
                Layer::Ether(f) => std::mem::swap(&mut f.src, &mut f.dst),
                _ => unreachable!(),
            }
            match &mut synack.0[1] {
                Layer::Ipv4(f) => std::mem::swap(&mut f.src, &mut f.dst),
                _ => unreachable!(),
            }
            let tcp = match &mut synack.0[2] {
                Layer::Tcp(f) => f,
                _ => unreachable!(),
            };
            std::mem::swap(&mut tcp.src_port, &mut tcp.dst_port);
            tcp.flags = Some(TcpFlags::SYN | TcpFlags::ACK);
            tcp.ack_num = Some(syn_seq.wrapping_add(1));
            tcp.seq_num = Some(500);
            tcp.checksum = None;
            let bytes = synack.to_bytes().unwrap();
            deliver.send(bytes).unwrap();

            let _ack_bytes = sent.recv().expect("ack sent");
        });

        tcp_conn.handshake().unwrap();
        responder.join().unwrap();

        assert_eq!(tcp_conn.remote_seq_num(), Some(SeqNum::new(501)));
        assert_eq!(tcp_conn.tcp_state.borrow().local_seq_num(), initial_local.forward(1));
        assert!(tcp_conn.tcp_state.borrow().syn_ack().is_some());
    }
}
