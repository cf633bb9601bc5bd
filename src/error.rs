//! Crate-wide error taxonomy. One enum per error kind, matching the shape of
//! `librips`'s hand rolled `TxError`/`RxError`: manual `Display` and
//! `std::error::Error` impls plus `From` conversions so `?` composes across
//! module boundaries.

use std::fmt;
use std::io;
use std::net::AddrParseError;

use crate::layer::Layers;

/// Bad configuration input: an unparsable address, or a socket call that
/// failed while setting a connection up.
#[derive(Debug)]
pub enum ConfigError {
    InvalidAddress(String),
    Io(io::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::InvalidAddress(msg) => write!(f, "invalid address: {}", msg),
            ConfigError::Io(e) => write!(f, "io error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<AddrParseError> for ConfigError {
    fn from(e: AddrParseError) -> Self {
        ConfigError::InvalidAddress(e.to_string())
    }
}

impl From<io::Error> for ConfigError {
    fn from(e: io::Error) -> Self {
        ConfigError::Io(e)
    }
}

/// `Layer::merge` was asked to overlay a layer of an incompatible variant.
#[derive(Debug)]
pub struct MergeError {
    pub message: String,
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "merge error: {}", self.message)
    }
}

impl std::error::Error for MergeError {}

/// `Layers::to_bytes` hit a field that is both unspecified and uncomputable.
#[derive(Debug)]
pub struct SerializeError {
    pub message: String,
}

impl fmt::Display for SerializeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "serialize error: {}", self.message)
    }
}

impl std::error::Error for SerializeError {}

/// A `LayerState::sent`/`received`/`close` call failed.
#[derive(Debug)]
pub enum StateError {
    Io(io::Error),
    Other(String),
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StateError::Io(e) => write!(f, "state io error: {}", e),
            StateError::Other(msg) => write!(f, "state error: {}", msg),
        }
    }
}

impl std::error::Error for StateError {}

impl From<io::Error> for StateError {
    fn from(e: io::Error) -> Self {
        StateError::Io(e)
    }
}

/// Returned by `ExpectFrame` when the deadline passes without a match. Its
/// `Display` is the field-wise diff between the best observed candidate and
/// the merged expectation, per spec.md §7.
#[derive(Debug, Clone)]
pub struct LayersError {
    pub want: Layers,
    pub got: Layers,
}

impl fmt::Display for LayersError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.want.diff(&self.got))
    }
}

impl std::error::Error for LayersError {}

/// Aggregates whatever subset of sniffer/injector/state close calls failed.
#[derive(Debug)]
pub struct CloseError {
    pub causes: Vec<String>,
}

impl fmt::Display for CloseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "close failed: {}", self.causes.join("; "))
    }
}

impl std::error::Error for CloseError {}

/// Top-level error returned by `Connection` methods. One variant per §7
/// error kind.
#[derive(Debug)]
pub enum ConnError {
    Config(ConfigError),
    Serialize(SerializeError),
    Io(io::Error),
    State(StateError),
    /// Deadline passed with at least one rejected candidate observed.
    Match(LayersError),
    /// Deadline passed and the sniffer never returned a single frame.
    NoFrames,
    /// A layer of the wrong protocol variant was returned where a typed
    /// wrapper (e.g. `TcpIpv4Connection::expect`) required a specific one.
    /// Indicates a harness bug, not a DUT behavior.
    ProtocolMismatch,
    Close(CloseError),
}

impl fmt::Display for ConnError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConnError::Config(e) => write!(f, "{}", e),
            ConnError::Serialize(e) => write!(f, "{}", e),
            ConnError::Io(e) => write!(f, "{}", e),
            ConnError::State(e) => write!(f, "{}", e),
            ConnError::Match(e) => write!(f, "{}", e),
            ConnError::NoFrames => write!(f, "got no frames"),
            ConnError::ProtocolMismatch => write!(f, "observed layer was not of the expected protocol"),
            ConnError::Close(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ConnError {}

impl From<ConfigError> for ConnError {
    fn from(e: ConfigError) -> Self {
        ConnError::Config(e)
    }
}

impl From<SerializeError> for ConnError {
    fn from(e: SerializeError) -> Self {
        ConnError::Serialize(e)
    }
}

impl From<io::Error> for ConnError {
    fn from(e: io::Error) -> Self {
        ConnError::Io(e)
    }
}

impl From<StateError> for ConnError {
    fn from(e: StateError) -> Self {
        ConnError::State(e)
    }
}

impl From<LayersError> for ConnError {
    fn from(e: LayersError) -> Self {
        ConnError::Match(e)
    }
}

impl From<CloseError> for ConnError {
    fn from(e: CloseError) -> Self {
        ConnError::Close(e)
    }
}

impl From<MergeError> for ConnError {
    fn from(e: MergeError) -> Self {
        ConnError::Serialize(SerializeError { message: e.message })
    }
}
