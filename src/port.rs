//! Ephemeral port reservation (spec.md §4.5): open a stream socket bound to
//! the local IP and port 0 so the kernel picks a free port, read the chosen
//! port back via `local_addr`, and keep the listener open for the life of
//! the connection so no other process on the test host can reuse the port.

use std::net::{Ipv4Addr, TcpListener};

use crate::error::ConfigError;

pub struct PortPicker {
    listener: Option<TcpListener>,
    port: u16,
}

impl PortPicker {
    pub fn reserve(local_ip: Ipv4Addr) -> Result<PortPicker, ConfigError> {
        let listener = TcpListener::bind((local_ip, 0))?;
        let port = listener.local_addr()?.port();
        debug!("reserved ephemeral port {} on {}", port, local_ip);
        Ok(PortPicker { listener: Some(listener), port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_open(&self) -> bool {
        self.listener.is_some()
    }

    /// Releases the held descriptor. Idempotent: calling this twice is a
    /// no-op, matching spec.md's "port-picker FD... open iff close() has
    /// not succeeded" invariant.
    pub fn close(&mut self) {
        if self.listener.take().is_some() {
            debug!("released ephemeral port {}", self.port);
        }
    }
}
