//! The `LayerState` abstraction (spec.md §3, §4.2): a polymorphic per-layer
//! state object bundling an outgoing template, an incoming template, and the
//! update rules that run as frames flow through a `Connection`.

pub mod ether;
pub mod ipv4;
pub mod tcp;
pub mod udp;

pub use ether::EtherState;
pub use ipv4::Ipv4State;
pub use tcp::TcpState;
pub use udp::UdpState;

use crate::error::StateError;
use crate::layer::Layer;

/// One layer's worth of connection state. Deliberately not `Send`/`Sync` —
/// spec.md §5 makes a `Connection` single-threaded by design, so the TCP
/// state can be shared between a `Connection`'s layer stack and its
/// `TcpIpv4Connection` façade via `Rc<RefCell<_>>` rather than
/// `Arc<Mutex<_>>`.
pub trait LayerState {
    /// The canonical outgoing template, deep-copied so the caller can freely
    /// mutate the result without corrupting shared state.
    fn outgoing(&self) -> Layer;

    /// The canonical expected layer, possibly consulting `observed` (TCP
    /// uses this to decide whether AckNum should stay wildcarded). Returns
    /// `None` when `observed` is of an incompatible protocol variant.
    fn incoming(&self, observed: &Layer) -> Option<Layer>;

    /// Updates internal state given what was actually put on the wire,
    /// after re-parsing the serialized bytes. `trailing` holds whatever
    /// layers followed this one in the frame (e.g. a Payload after TCP), so
    /// TCP's sequence-number advancement can account for their byte length.
    fn sent(&mut self, actual: &Layer, trailing: &[Layer]) -> Result<(), StateError>;

    /// Updates internal state given a matched incoming layer. `trailing` is
    /// the same as for `sent`, but drawn from the observed frame.
    fn received(&mut self, actual: &Layer, trailing: &[Layer]) -> Result<(), StateError>;

    /// Releases any held resources (e.g. a port-picker file descriptor).
    /// Idempotent: a second call is a no-op.
    fn close(&mut self) -> Result<(), StateError>;
}
