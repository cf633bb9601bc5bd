use pnet::packet::ethernet::EtherTypes;

use crate::config::Config;
use crate::error::StateError;
use crate::layer::{EtherFields, Layer};
use crate::state::LayerState;

/// Stateless ethernet leg: fixed src/dst endpoints derived from `Config` at
/// construction. spec.md §4.2 "Ether state".
pub struct EtherState {
    outgoing: EtherFields,
    incoming: EtherFields,
}

impl EtherState {
    pub fn new(config: &Config) -> EtherState {
        EtherState {
            outgoing: EtherFields {
                src: Some(config.local_mac),
                dst: Some(config.remote_mac),
                ether_type: Some(EtherTypes::Ipv4),
            },
            incoming: EtherFields {
                src: Some(config.remote_mac),
                dst: Some(config.local_mac),
                ether_type: Some(EtherTypes::Ipv4),
            },
        }
    }
}

impl LayerState for EtherState {
    fn outgoing(&self) -> Layer {
        Layer::Ether(self.outgoing)
    }

    fn incoming(&self, observed: &Layer) -> Option<Layer> {
        match observed {
            Layer::Ether(_) => Some(Layer::Ether(self.incoming)),
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
    fn outgoing_uses_local_src_remote_dst() {
        let state = EtherState::new(&config());
        let layer = state.outgoing();
        let f = match layer {
            Layer::Ether(f) => f,
            _ => panic!("expected ether"),
        };
        assert_eq!(f.src, Some(config().local_mac));
        assert_eq!(f.dst, Some(config().remote_mac));
    }

    #[test]
    fn incoming_mirrors_src_and_dst() {
        let state = EtherState::new(&config());
        let observed = Layer::Ether(EtherFields::default());
        let layer = state.incoming(&observed).unwrap();
        let f = match layer {
            Layer::Ether(f) => f,
            _ => panic!("expected ether"),
        };
        assert_eq!(f.src, Some(config().remote_mac));
        assert_eq!(f.dst, Some(config().local_mac));
    }

    #[test]
    fn incoming_rejects_wrong_variant() {
        let state = EtherState::new(&config());
        assert!(state.incoming(&Layer::Ipv4(Default::default())).is_none());
    }
}
