//! The `Connection` engine (spec.md §4.3): composes N `LayerState`s into one
//! pipeline and implements `CreateFrame`/`SendFrame`/`ExpectFrame`/`Close`.

use std::time::{Duration, Instant};

use crate::error::{ConnError, LayersError};
use crate::io::{Injector, Sniffer};
use crate::layer::Layers;
use crate::state::LayerState;

/// Ordered composition of layer states plus the injector/sniffer pair that
/// moves bytes on and off the wire. Single-threaded by design (spec.md §5).
pub struct Connection<I: Injector, S: Sniffer> {
    layer_states: Vec<Box<dyn LayerState>>,
    injector: I,
    sniffer: S,
}

impl<I: Injector, S: Sniffer> Connection<I, S> {
    pub fn new(layer_states: Vec<Box<dyn LayerState>>, injector: I, sniffer: S) -> Connection<I, S> {
        Connection { layer_states, injector, sniffer }
    }

    pub fn layer_count(&self) -> usize {
        self.layer_states.len()
    }

    /// Emits one outgoing layer per layer state, merges `overrides` into the
    /// innermost of those, then appends `extras` verbatim.
    pub fn create_frame(&self, overrides: &Layers, extras: &[crate::layer::Layer]) -> Result<Layers, ConnError> {
        let layers: Vec<crate::layer::Layer> = self.layer_states.iter().map(|s| s.outgoing()).collect();
        let mut frame = Layers::new(layers);
        frame.merge(overrides)?;
        for extra in extras {
            frame.0.push(extra.clone());
        }
        Ok(frame)
    }

    /// Serializes `frame`, injects it, re-parses the emitted bytes, and
    /// updates every layer state's `sent()` from the re-parsed layers — so
    /// state reflects the concrete bytes transmitted, not the skeleton the
    /// caller supplied (spec.md §4.3 "Rationale for re-parse").
    pub fn send_frame(&mut self, frame: &Layers) -> Result<(), ConnError> {
        trace!("composed outgoing frame: {} layers", frame.len());
        let bytes = frame.to_bytes()?;
        self.injector.send(&bytes)?;
        debug!("sent {} bytes", bytes.len());

        let parsed = Layers::parse(&bytes);
        let n = self.layer_states.len();
        for (i, state) in self.layer_states.iter_mut().enumerate() {
            let actual = parsed.get(i).ok_or_else(|| {
                ConnError::State(crate::error::StateError::Other(format!(
                    "serialized frame unexpectedly missing layer {}",
                    i
                )))
            })?;
            let trailing: &[crate::layer::Layer] = if i + 1 == n { &parsed.0[n..] } else { &[] };
            state.sent(actual, trailing)?;
        }
        Ok(())
    }

    /// Loops sniffing and matching until `expected` is satisfied or
    /// `timeout` elapses (spec.md §4.3 "ExpectFrame").
    pub fn expect_frame(&mut self, expected: &Layers, timeout: Duration) -> Result<Layers, ConnError> {
        let deadline = Instant::now() + timeout;
        let mut last_mismatch: Option<LayersError> = None;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(match last_mismatch {
                    Some(e) => e.into(),
                    None => ConnError::NoFrames,
                });
            }

            let bytes = match self.sniffer.recv(remaining)? {
                Some(bytes) => bytes,
                None => {
                    return Err(match last_mismatch {
                        Some(e) => e.into(),
                        None => ConnError::NoFrames,
                    });
                }
            };

            let parsed = Layers::parse(&bytes);
            if parsed.len() < self.layer_states.len() {
                trace!("ignored short frame: {} of {} layers parsed", parsed.len(), self.layer_states.len());
                continue;
            }

            let mut to_match = Vec::with_capacity(self.layer_states.len());
            let mut incompatible = false;
            for (i, state) in self.layer_states.iter().enumerate() {
                match state.incoming(parsed.get(i).expect("checked len above")) {
                    Some(layer) => to_match.push(layer),
                    None => {
                        incompatible = true;
                        break;
                    }
                }
            }
            if incompatible {
                continue;
            }
            let mut to_match = Layers::new(to_match);
            if to_match.merge(expected).is_err() {
                trace!("expectation merge failed against a candidate frame");
                continue;
            }

            if to_match.matches_prefix(&parsed) {
                let n = self.layer_states.len();
                for (i, state) in self.layer_states.iter_mut().enumerate() {
                    let actual = parsed.get(i).expect("checked len above");
                    let trailing: &[crate::layer::Layer] = if i + 1 == n { &parsed.0[n..] } else { &[] };
                    state.received(actual, trailing)?;
                }
                debug!("expect_frame matched after {} layers observed", parsed.len());
                return Ok(parsed);
            }

            let diff = to_match.diff(&parsed);
            trace!("rejected candidate frame: {}", diff);
            last_mismatch = Some(LayersError { want: to_match, got: parsed });
        }
    }

    /// Aggregates sniffer close, injector close, and every state's close
    /// into one `CloseError` if any of them failed.
    pub fn close(&mut self) -> Result<(), ConnError> {
        let mut causes = Vec::new();
        if let Err(e) = self.sniffer.close() {
            causes.push(format!("sniffer: {}", e));
        }
        if let Err(e) = self.injector.close() {
            causes.push(format!("injector: {}", e));
        }
        for (i, state) in self.layer_states.iter_mut().enumerate() {
            if let Err(e) = state.close() {
                causes.push(format!("layer {}: {}", i, e));
            }
        }
        if causes.is_empty() {
            Ok(())
        } else {
            Err(crate::error::CloseError { causes }.into())
        }
    }
}
