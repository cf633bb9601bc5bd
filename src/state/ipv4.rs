use pnet::packet::ip::IpNextHeaderProtocols;

use crate::config::Config;
use crate::error::StateError;
use crate::layer::{Ipv4Fields, Layer};
use crate::state::LayerState;

/// Stateless IPv4 leg, identical in shape to `EtherState` but operating on
/// IPv4 addresses. spec.md §4.2 "IPv4 state".
pub struct Ipv4State {
    outgoing: Ipv4Fields,
    incoming: Ipv4Fields,
}

impl Ipv4State {
    pub fn new(config: &Config, protocol: pnet::packet::ip::IpNextHeaderProtocol) -> Ipv4State {
        Ipv4State {
            outgoing: Ipv4Fields {
                src: Some(config.local_ipv4),
                dst: Some(config.remote_ipv4),
                protocol: Some(protocol),
                ..Default::default()
            },
            incoming: Ipv4Fields {
                src: Some(config.remote_ipv4),
                dst: Some(config.local_ipv4),
                protocol: Some(protocol),
                ..Default::default()
            },
        }
    }

    pub fn tcp(config: &Config) -> Ipv4State {
        Ipv4State::new(config, IpNextHeaderProtocols::Tcp)
    }

    pub fn udp(config: &Config) -> Ipv4State {
        Ipv4State::new(config, IpNextHeaderProtocols::Udp)
    }
}

impl LayerState for Ipv4State {
    fn outgoing(&self) -> Layer {
        Layer::Ipv4(self.outgoing)
    }

    fn incoming(&self, observed: &Layer) -> Option<Layer> {
        match observed {
            Layer::Ipv4(_) => Some(Layer::Ipv4(self.incoming)),
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
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::new("192.0.2.1", "192.0.2.2", "02:00:00:00:00:01", "02:00:00:00:00:02").unwrap()
    }

    #[test]
    fn outgoing_and_incoming_mirror_endpoints() {
        let state = Ipv4State::tcp(&config());
        let out = match state.outgoing() {
            Layer::Ipv4(f) => f,
            _ => panic!(),
        };
        assert_eq!(out.src, Some(config().local_ipv4));
        assert_eq!(out.dst, Some(config().remote_ipv4));

        let inc = state.incoming(&Layer::Ipv4(Default::default())).unwrap();
        let inc = match inc {
            Layer::Ipv4(f) => f,
            _ => panic!(),
        };
        assert_eq!(inc.src, Some(config().remote_ipv4));
        assert_eq!(inc.dst, Some(config().local_ipv4));
    }
}
