//! Reference `Injector`/`Sniffer` pair backed by `pnet::datalink`, mirroring
//! the teacher's `ethernet::Ethernet`/`EthernetReader` split: a direct
//! blocking sender, and a background thread draining the inherently-blocking
//! `EthernetDataLinkReceiver::next()` into an `mpsc` channel so callers can
//! receive with a timeout instead of blocking forever.

use std::io;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread;
use std::time::Duration;

use pnet::datalink::{self, Channel, DataLinkReceiver, DataLinkSender, NetworkInterface};

use crate::io::{Injector, Sniffer};

/// Opens a pnet datalink channel for `interface` and returns the matching
/// `PnetInjector`/`PnetSniffer` pair.
pub fn open(interface: &NetworkInterface) -> io::Result<(PnetInjector, PnetSniffer)> {
    let config = datalink::Config::default();
    let channel = datalink::channel(interface, config)?;
    let (tx, rx) = match channel {
        Channel::Ethernet(tx, rx) => (tx, rx),
        _ => return Err(io::Error::new(io::ErrorKind::Other, "unsupported datalink channel type")),
    };
    Ok((PnetInjector { sender: tx }, PnetSniffer::spawn(rx)))
}

pub struct PnetInjector {
    sender: Box<dyn DataLinkSender>,
}

impl Injector for PnetInjector {
    fn send(&mut self, frame: &[u8]) -> io::Result<()> {
        match self.sender.send_to(frame, None) {
            Some(result) => result,
            None => Err(io::Error::new(io::ErrorKind::Other, "insufficient buffer space for frame")),
        }
    }

    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub struct PnetSniffer {
    frames: Receiver<Vec<u8>>,
    stop: Sender<()>,
}

impl PnetSniffer {
    fn spawn(receiver: Box<dyn DataLinkReceiver>) -> PnetSniffer {
        let (frame_tx, frame_rx) = mpsc::channel();
        let (stop_tx, stop_rx) = mpsc::channel();
        thread::spawn(move || sniff_loop(receiver, frame_tx, stop_rx));
        PnetSniffer { frames: frame_rx, stop: stop_tx }
    }
}

fn sniff_loop(mut receiver: Box<dyn DataLinkReceiver>, frames: Sender<Vec<u8>>, stop: Receiver<()>) {
    loop {
        match stop.try_recv() {
            Err(TryRecvError::Empty) => {}
            _ => return,
        }
        match receiver.next() {
            Ok(frame) => {
                if frames.send(frame.to_vec()).is_err() {
                    return;
                }
            }
            Err(e) => {
                warn!("pnet sniffer read failed: {}", e);
                return;
            }
        }
    }
}

impl Sniffer for PnetSniffer {
    fn recv(&mut self, timeout: Duration) -> io::Result<Option<Vec<u8>>> {
        match self.frames.recv_timeout(timeout) {
            Ok(frame) => Ok(Some(frame)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                Err(io::Error::new(io::ErrorKind::Other, "sniffer reader thread exited"))
            }
        }
    }

    fn close(&mut self) -> io::Result<()> {
        let _ = self.stop.send(());
        Ok(())
    }
}
