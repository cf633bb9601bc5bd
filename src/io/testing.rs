//! In-memory `Injector`/`Sniffer` mocks modeled directly on the teacher's
//! `testing::ethernet::EthernetTx` mpsc-channel mock, used by this crate's
//! own tests and available to downstream integration tests in place of a
//! real interface.

use std::io;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use crate::io::{Injector, Sniffer};

/// Hands every sent frame to the paired `Receiver<Vec<u8>>` so a test can
/// assert on exactly what a `Connection` put on the wire.
pub struct ChannelInjector {
    chan: Sender<Vec<u8>>,
    closed: bool,
}

impl ChannelInjector {
    pub fn new() -> (ChannelInjector, Receiver<Vec<u8>>) {
        let (tx, rx) = mpsc::channel();
        (ChannelInjector { chan: tx, closed: false }, rx)
    }
}

impl Injector for ChannelInjector {
    fn send(&mut self, frame: &[u8]) -> io::Result<()> {
        self.chan
            .send(frame.to_vec())
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))
    }

    fn close(&mut self) -> io::Result<()> {
        self.closed = true;
        Ok(())
    }
}

/// Replays frames queued in through the paired `Sender<Vec<u8>>`, honoring
/// `recv`'s timeout semantics so tests can exercise `ExpectFrame`'s deadline
/// handling deterministically.
pub struct ChannelSniffer {
    chan: Receiver<Vec<u8>>,
}

impl ChannelSniffer {
    pub fn new() -> (ChannelSniffer, Sender<Vec<u8>>) {
        let (tx, rx) = mpsc::channel();
        (ChannelSniffer { chan: rx }, tx)
    }
}

impl Sniffer for ChannelSniffer {
    fn recv(&mut self, timeout: Duration) -> io::Result<Option<Vec<u8>>> {
        match self.chan.recv_timeout(timeout) {
            Ok(frame) => Ok(Some(frame)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Ok(None),
        }
    }

    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}
