use rand::Rng;

use crate::config::Config;
use crate::error::StateError;
use crate::layer::{Layer, Layers, TcpFields};
use crate::port::PortPicker;
use crate::seq::SeqNum;
use crate::state::LayerState;

/// Stateful TCP leg (spec.md §4.2 "TCP state"): tracks local and remote
/// sequence numbers and advances them per RFC 793 rules as frames are sent
/// and received, and holds the captured SYN|ACK from a handshake.
pub struct TcpState {
    port: PortPicker,
    remote_port: u16,
    local_seq_num: SeqNum,
    remote_seq_num: Option<SeqNum>,
    syn_ack: Option<Layers>,
}

impl TcpState {
    pub fn new(config: &Config, remote_port: u16) -> Result<TcpState, crate::error::ConfigError> {
        let port = PortPicker::reserve(config.local_ipv4)?;
        let initial = rand::thread_rng().gen::<u32>();
        Ok(TcpState {
            port,
            remote_port,
            local_seq_num: SeqNum::new(initial),
            remote_seq_num: None,
            syn_ack: None,
        })
    }

    pub fn local_port(&self) -> u16 {
        self.port.port()
    }

    pub fn local_seq_num(&self) -> SeqNum {
        self.local_seq_num
    }

    pub fn remote_seq_num(&self) -> Option<SeqNum> {
        self.remote_seq_num
    }

    /// Treated as private unless explicitly surfaced (spec.md §9 open
    /// question): only `tcp_ipv4::Handshake` reads/writes this.
    pub fn syn_ack(&self) -> Option<&Layers> {
        self.syn_ack.as_ref()
    }

    pub fn set_syn_ack(&mut self, layers: Layers) {
        self.syn_ack = Some(layers);
    }

    /// Advances `seq` by the combined byte length of every layer in `trailing`
    /// (everything after the TCP header in a parsed or to-be-sent frame),
    /// plus one more if `tcp` carries SYN or FIN.
    fn advance(seq: SeqNum, tcp: &TcpFields, trailing: &[Layer]) -> SeqNum {
        let payload_len: usize = trailing.iter().map(layer_byte_len).sum();
        let mut next = seq.forward(payload_len as u32);
        if tcp.has_syn() || tcp.has_fin() {
            next = next.forward(1);
        }
        next
    }
}

fn layer_byte_len(layer: &Layer) -> usize {
    match layer {
        Layer::Payload(p) => p.len(),
        _ => 0,
    }
}

impl LayerState for TcpState {
    fn outgoing(&self) -> Layer {
        Layer::Tcp(TcpFields {
            src_port: Some(self.port.port()),
            dst_port: Some(self.remote_port),
            seq_num: Some(self.local_seq_num.value()),
            ack_num: self.remote_seq_num.map(SeqNum::value),
            ..Default::default()
        })
    }

    fn incoming(&self, observed: &Layer) -> Option<Layer> {
        let observed_tcp = observed.as_tcp()?;
        let mut fields = TcpFields {
            src_port: Some(self.remote_port),
            dst_port: Some(self.port.port()),
            ..Default::default()
        };
        if let Some(remote) = self.remote_seq_num {
            fields.seq_num = Some(remote.value());
        }
        if observed_tcp.has_ack() {
            fields.ack_num = Some(self.local_seq_num.value());
        }
        Some(Layer::Tcp(fields))
    }

    fn sent(&mut self, actual: &Layer, trailing: &[Layer]) -> Result<(), StateError> {
        let tcp = actual
            .as_tcp()
            .ok_or_else(|| StateError::Other("expected a tcp layer in sent()".into()))?;
        self.local_seq_num = Self::advance(self.local_seq_num, tcp, trailing);
        Ok(())
    }

    fn received(&mut self, actual: &Layer, trailing: &[Layer]) -> Result<(), StateError> {
        let tcp = actual
            .as_tcp()
            .ok_or_else(|| StateError::Other("expected a tcp layer in received()".into()))?;
        let observed_seq = SeqNum::new(tcp.seq_num.unwrap_or(0));
        self.remote_seq_num = Some(Self::advance(observed_seq, tcp, trailing));
        Ok(())
    }

    fn close(&mut self) -> Result<(), StateError> {
        self.port.close();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pnet::packet::tcp::TcpFlags;
    use crate::layer::PayloadFields;

    fn config() -> Config {
        Config::new("192.0.2.1", "192.0.2.2", "02:00:00:00:00:01", "02:00:00:00:00:02").unwrap()
    }

    #[test]
    fn advances_local_by_one_on_syn() {
        let mut state = TcpState::new(&config(), 80).unwrap();
        let start = state.local_seq_num();
        let syn = Layer::Tcp(TcpFields { flags: Some(TcpFlags::SYN), ..Default::default() });
        state.sent(&syn, &[]).unwrap();
        assert_eq!(state.local_seq_num(), start.forward(1));
    }

    #[test]
    fn advances_local_by_payload_len_without_syn_fin() {
        let mut state = TcpState::new(&config(), 80).unwrap();
        let start = state.local_seq_num();
        let ack = Layer::Tcp(TcpFields { flags: Some(TcpFlags::ACK), ..Default::default() });
        let payload = Layer::Payload(PayloadFields { bytes: Some(vec![0u8; 100]) });
        state.sent(&ack, &[payload]).unwrap();
        assert_eq!(state.local_seq_num(), start.forward(100));
    }

    #[test]
    fn remote_seq_num_set_on_receive_of_syn() {
        let mut state = TcpState::new(&config(), 80).unwrap();
        let syn = Layer::Tcp(TcpFields { seq_num: Some(41), flags: Some(TcpFlags::SYN), ..Default::default() });
        state.received(&syn, &[]).unwrap();
        assert_eq!(state.remote_seq_num(), Some(SeqNum::new(42)));
    }

    #[test]
    fn ack_num_wildcard_unless_observed_has_ack_flag() {
        let state = TcpState::new(&config(), 80).unwrap();
        let syn_only = Layer::Tcp(TcpFields { flags: Some(TcpFlags::SYN), ..Default::default() });
        let expect = state.incoming(&syn_only).unwrap();
        assert_eq!(expect.as_tcp().unwrap().ack_num, None);

        let syn_ack = Layer::Tcp(TcpFields { flags: Some(TcpFlags::SYN | TcpFlags::ACK), ..Default::default() });
        let expect = state.incoming(&syn_ack).unwrap();
        assert_eq!(expect.as_tcp().unwrap().ack_num, Some(state.local_seq_num().value()));
    }

    #[test]
    fn outgoing_writes_local_and_remote_seq() {
        let mut state = TcpState::new(&config(), 80).unwrap();
        let syn = Layer::Tcp(TcpFields { seq_num: Some(9), flags: Some(TcpFlags::SYN), ..Default::default() });
        state.received(&syn, &[]).unwrap();
        let out = state.outgoing().as_tcp().unwrap().clone();
        assert_eq!(out.seq_num, Some(state.local_seq_num().value()));
        assert_eq!(out.ack_num, Some(state.remote_seq_num().unwrap().value()));
    }

    #[test]
    fn close_releases_port() {
        let mut state = TcpState::new(&config(), 80).unwrap();
        state.close().unwrap();
        assert!(!state.port.is_open());
    }
}
