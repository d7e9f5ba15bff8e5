//! Shared types for KNX property access.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use regex::Regex;

use crate::error::ConfigError;
use crate::protocol::codec::{decode_integer, to_hex};
use crate::protocol::pdt::Pdt;

// ==================== Property keys & definitions ====================

/// Object type scope of a property definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectScope {
    /// Matches any interface object type for the given property id.
    Global,
    /// A concrete interface object type.
    Type(u16),
}

impl fmt::Display for ObjectScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectScope::Global => write!(f, "global"),
            ObjectScope::Type(t) => write!(f, "{}", t),
        }
    }
}

/// Key of a property definition: object type scope and property id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropertyKey {
    pub object_scope: ObjectScope,
    pub pid: u16,
}

impl PropertyKey {
    pub fn new(object_type: u16, pid: u16) -> Self {
        Self {
            object_scope: ObjectScope::Type(object_type),
            pid,
        }
    }

    pub fn global(pid: u16) -> Self {
        Self {
            object_scope: ObjectScope::Global,
            pid,
        }
    }
}

/// Property metadata from a definitions source.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDefinition {
    pub key: PropertyKey,
    /// Human readable name
    pub name: String,
    /// Short identifier, e.g. `PID.OBJECT_TYPE`
    pub pid_name: Option<String>,
    /// Default data type, `None` if unspecified
    pub pdt: Option<Pdt>,
}

// ==================== Descriptions ====================

/// Property description as reported live by a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Description {
    pub property_index: u16,
    pub object_type: u16,
    pub object_index: u16,
    pub pid: u16,
    /// Reported data type, `None` means "use the catalog default"
    pub pdt: Option<Pdt>,
    pub current_elements: u16,
    pub max_elements: u16,
    pub read_level: u8,
    pub write_level: u8,
    pub write_enabled: bool,
}

// ==================== Addressing ====================

/// KNX individual address `area.line.device`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndividualAddress(u16);

fn address_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{1,2})[./](\d{1,2})[./](\d{1,3})$").unwrap())
}

impl IndividualAddress {
    pub fn new(area: u8, line: u8, device: u8) -> Option<Self> {
        if area > 0x0f || line > 0x0f {
            return None;
        }
        Some(Self(
            (u16::from(area) << 12) | (u16::from(line) << 8) | u16::from(device),
        ))
    }

    pub fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u16 {
        self.0
    }

    pub fn area(&self) -> u8 {
        (self.0 >> 12) as u8
    }

    pub fn line(&self) -> u8 {
        ((self.0 >> 8) & 0x0f) as u8
    }

    pub fn device(&self) -> u8 {
        (self.0 & 0xff) as u8
    }
}

impl fmt::Display for IndividualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.area(), self.line(), self.device())
    }
}

impl FromStr for IndividualAddress {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidAddress(s.to_string());
        if let Some(caps) = address_regex().captures(s.trim()) {
            let part = |i: usize| caps[i].parse::<u8>().map_err(|_| invalid());
            return IndividualAddress::new(part(1)?, part(2)?, part(3)?).ok_or_else(invalid);
        }
        let raw = decode_integer(s.trim()).map_err(|_| invalid())?;
        u16::try_from(raw).map(Self).map_err(|_| invalid())
    }
}

/// KNX transmission medium of the network link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Medium {
    Tp0,
    #[default]
    Tp1,
    Pl110,
    Pl132,
    Rf,
}

impl FromStr for Medium {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tp0" => Ok(Medium::Tp0),
            "tp1" => Ok(Medium::Tp1),
            "p110" => Ok(Medium::Pl110),
            "p132" => Ok(Medium::Pl132),
            "rf" => Ok(Medium::Rf),
            other => Err(ConfigError::UnknownMedium(other.to_string())),
        }
    }
}

impl fmt::Display for Medium {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Medium::Tp0 => "tp0",
            Medium::Tp1 => "tp1",
            Medium::Pl110 => "p110",
            Medium::Pl132 => "p132",
            Medium::Rf => "rf",
        };
        write!(f, "{}", s)
    }
}

/// Opaque authorization key handed through to the remote adapter.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthorizeKey(Vec<u8>);

impl AuthorizeKey {
    pub fn from_bytes(key: Vec<u8>) -> Self {
        Self(key)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

// Keys never end up in logs.
impl fmt::Debug for AuthorizeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthorizeKey(<{} bytes>)", self.0.len())
    }
}

impl FromStr for AuthorizeKey {
    type Err = ConfigError;

    /// Parses a 32 bit key number into 4 big-endian bytes.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = decode_integer(s).map_err(|_| ConfigError::InvalidAuthorizeKey(s.to_string()))?;
        let value =
            u32::try_from(value).map_err(|_| ConfigError::InvalidAuthorizeKey(s.to_string()))?;
        Ok(Self(value.to_be_bytes().to_vec()))
    }
}

// ==================== Close & frame events ====================

/// Who initiated closing a link or adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseInitiator {
    /// Explicit close requested by the local user.
    User,
    /// Closed by the client side, e.g. on a protocol error.
    Client,
    /// Closed by the remote endpoint.
    Server,
    /// Closed by the environment, e.g. the I/O task died.
    Internal,
}

/// Notification that a link or adapter was closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseEvent {
    pub initiator: CloseInitiator,
    pub reason: String,
}

impl CloseEvent {
    pub fn new(initiator: CloseInitiator, reason: impl Into<String>) -> Self {
        Self {
            initiator,
            reason: reason.into(),
        }
    }

    pub fn user_request() -> Self {
        Self::new(CloseInitiator::User, "user request")
    }

    pub fn is_user_request(&self) -> bool {
        self.initiator == CloseInitiator::User
    }
}

/// A bus frame received on a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub raw: Bytes,
    /// Decoded textual form supplied by the link, if any
    pub decoded: Option<String>,
}

impl Frame {
    pub fn new(raw: impl Into<Bytes>, decoded: Option<String>) -> Self {
        Self {
            raw: raw.into(),
            decoded,
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.decoded {
            Some(text) => write!(f, "{}", text),
            None => write!(f, "{}", to_hex(&self.raw)),
        }
    }
}

/// Indication or confirmation frame delivered by a link.
#[derive(Debug, Clone)]
pub struct FrameEvent {
    /// Name of the link that received the frame
    pub source: String,
    pub frame: Frame,
    pub received_at: DateTime<Utc>,
}
