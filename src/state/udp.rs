use crate::config::Config;
use crate::error::StateError;
use crate::layer::{Layer, UdpFields};
use crate::port::PortPicker;
use crate::state::LayerState;

/// UDP leg. Reserves an ephemeral local port and writes it into the
/// outgoing SrcPort and the incoming DstPort. spec.md §4.2 "UDP state".
pub struct UdpState {
    port: PortPicker,
    remote_port: u16,
}

impl UdpState {
    pub fn new(config: &Config, remote_port: u16) -> Result<UdpState, crate::error::ConfigError> {
        let port = PortPicker::reserve(config.local_ipv4)?;
        Ok(UdpState { port, remote_port })
    }

    pub fn local_port(&self) -> u16 {
        self.port.port()
    }
}

impl LayerState for UdpState {
    fn outgoing(&self) -> Layer {
        Layer::Udp(UdpFields { src_port: Some(self.port.port()), dst_port: Some(self.remote_port), ..Default::default() })
    }

    fn incoming(&self, observed: &Layer) -> Option<Layer> {
        match observed {
            Layer::Udp(_) => Some(Layer::Udp(UdpFields {
                src_port: Some(self.remote_port),
                dst_port: Some(self.port.port()),
                ..Default::default()
            })),
            _ => None,
        }
    }

    fn sent(&mut self, _actual: &Layer, _trailing: &[Layer]) -> Result<(), StateError> {
        Ok(())
    }

    fn received(&mut self, _actual: &Layer, _trailing: &[Layer]) -> Result<(), StateError> {
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

    fn config() -> Config {
        Config::new("127.0.0.1", "127.0.0.1", "02:00:00:00:00:01", "02:00:00:00:00:02").unwrap()
    }

    #[test]
    fn reserves_distinct_local_port_per_state() {
        let a = UdpState::new(&config(), 9999).unwrap();
        let b = UdpState::new(&config(), 9999).unwrap();
        assert_ne!(a.local_port(), b.local_port());
    }

    #[test]
    fn outgoing_src_is_reserved_port() {
        let state = UdpState::new(&config(), 53).unwrap();
        let out = match state.outgoing() {
            Layer::Udp(f) => f,
            _ => panic!(),
        };
        assert_eq!(out.src_port, Some(state.local_port()));
        assert_eq!(out.dst_port, Some(53));
    }

    #[test]
    fn close_releases_port() {
        let mut state = UdpState::new(&config(), 53).unwrap();
        state.close().unwrap();
        assert!(!state.port.is_open());
    }
}
