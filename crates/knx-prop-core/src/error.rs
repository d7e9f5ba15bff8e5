//! Error types for knx-prop core.
//!
//! Fatal classes (`ConfigError`, `TransportError`) abort a session before any
//! command runs. `ProtocolError`, `ParseError` and `LoadError` are recoverable
//! and never escape the command interpreter.

use std::path::PathBuf;

use thiserror::Error;

/// Core error type for shared operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("{0}")]
    Protocol(#[from] ProtocolError),

    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("session is closed")]
    SessionClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Whether the error is handled at the single command boundary.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CoreError::Protocol(_) | CoreError::Parse(_) | CoreError::Load(_)
        )
    }
}

/// Bad or missing connection options, detected before any I/O.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no connection category specified")]
    NoConnectionCategory,

    #[error("no host or serial port specified")]
    NoEndpoint,

    #[error("-remote option is mandatory with -serial")]
    RemoteRequiredForSerial,

    #[error("local device management requires a host")]
    LocalRequiresHost,

    #[error("failed to read host {host}")]
    UnresolvableHost { host: String },

    #[error("unknown medium {0}")]
    UnknownMedium(String),

    #[error("invalid authorize key {0}")]
    InvalidAuthorizeKey(String),

    #[error("invalid individual address {0}")]
    InvalidAddress(String),
}

/// Link or adapter could not be established.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connect to {endpoint} failed: {message}")]
    ConnectFailed { endpoint: String, message: String },

    #[error("protocol negotiation with {endpoint} failed: {message}")]
    Negotiation { endpoint: String, message: String },

    #[error("no driver for {0} available")]
    NoDriver(String),
}

/// A single property service request failed against a live adapter.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("interface object {0} not found")]
    NoSuchObject(u16),

    #[error("property {pid} not found in object {object_index}")]
    NoSuchProperty { object_index: u16, pid: u16 },

    #[error("property index {property_index} not found in object {object_index}")]
    NoSuchPropertyIndex {
        object_index: u16,
        property_index: u16,
    },

    #[error("element range {start}..{end} outside of {current} current elements")]
    ElementRange { start: u16, end: u32, current: u16 },

    #[error("element {end} exceeds maximum of {max} elements")]
    MaxElements { end: u32, max: u16 },

    #[error("property {pid} is read-only")]
    WriteDisabled { pid: u16 },

    #[error("data length {actual} does not match {expected} bytes for {count} elements")]
    DataLength {
        expected: usize,
        actual: usize,
        count: u16,
    },

    #[error("no translation for PDT {0}")]
    TranslationUnsupported(String),

    #[error("invalid value '{value}' for PDT {pdt}")]
    InvalidValue { value: String, pdt: String },

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("connection closed")]
    Closed,
}

/// User supplied literal could not be parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid number ({0})")]
    InvalidNumber(String),

    #[error("number out of range ({0})")]
    OutOfRange(String),

    #[error("malformed data ({0})")]
    MalformedData(String),
}

/// Property definitions could not be loaded.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed definitions in {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
