//! Raw frame transport contracts (spec.md §1, §6): the core depends only on
//! these send/receive/close contracts, never on a concrete Injector or
//! Sniffer implementation.

pub mod raw;
pub mod testing;

use std::io;
use std::time::Duration;

/// Writes raw Ethernet frames to an interface. Failures are fatal to the
/// test (spec.md §6 "Injector contract").
pub trait Injector {
    fn send(&mut self, frame: &[u8]) -> io::Result<()>;
    fn close(&mut self) -> io::Result<()>;
}

/// Reads frames matching an installed filter from an interface. `recv`
/// returns `Ok(None)` on timeout rather than blocking indefinitely.
pub trait Sniffer {
    fn recv(&mut self, timeout: Duration) -> io::Result<Option<Vec<u8>>>;
    fn close(&mut self) -> io::Result<()>;
}
