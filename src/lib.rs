// Copyright (c) 2016 Linus Färnstrand <faern@faern.net>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # packetprobe
//!
//! A layered connection-state engine for a network-protocol conformance
//! test harness: it composes outgoing Ethernet/IPv4/TCP/UDP frames from
//! per-layer templates merged with caller overrides, classifies incoming
//! frames against per-layer expectations with wildcard support, and mutates
//! per-layer state (TCP sequence numbers, ephemeral ports) as frames flow
//! through a [`connection::Connection`].
//!
//! This crate does not implement a full TCP stack: no retransmission, no
//! congestion control, and a `Connection` is single-threaded by design. It
//! also does not parse command-line flags or manage a raw packet socket
//! directly — those are the embedding test harness's job; this crate
//! depends only on the [`io::Injector`]/[`io::Sniffer`] contracts.
//!
//! ## Layout
//!
//! - [`config`] — immutable harness configuration passed into every factory.
//! - [`layer`] — the per-protocol header value model: optional fields,
//!   `merge`, `match`, `diff`, and bit-exact serialize/parse.
//! - [`state`] — the [`state::LayerState`] trait and one concrete state per
//!   protocol (stateless Ether/IPv4/UDP, stateful TCP).
//! - [`port`] — ephemeral port reservation shared by the UDP and TCP states.
//! - [`io`] — the `Injector`/`Sniffer` contracts, a `pnet::datalink`-backed
//!   reference implementation, and an in-memory mock pair for tests.
//! - [`connection`] — the `Connection` engine: `create_frame`, `send_frame`,
//!   `expect_frame`, `close`.
//! - [`tcp_ipv4`] / [`udp_ipv4`] — typed façades over `Connection` for the
//!   two supported protocol combinations.
//! - [`error`] — the crate-wide error taxonomy.

#[macro_use]
extern crate log;

pub mod config;
pub mod connection;
pub mod error;
pub mod io;
pub mod layer;
pub mod port;
pub mod seq;
pub mod state;
pub mod tcp_ipv4;
pub mod udp_ipv4;

pub use config::{Config, ConfigError};
pub use connection::Connection;
pub use error::ConnError;
pub use layer::{Layer, Layers};
pub use seq::SeqNum;
pub use tcp_ipv4::{new_tcp_ipv4, TcpIpv4Connection};
pub use udp_ipv4::{new_udp_ipv4, UdpIpv4Connection};
