//! Device communication layer.
//!
//! A [`Link`] carries frames to and from the bus, an [`Adapter`] performs
//! property services on one interface object server, and a [`Connector`]
//! opens both. Transports plug in by implementing these traits; the crate
//! ships the in-memory implementation in [`memory`].

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{ProtocolError, TransportError};
use crate::session::config::{LinkSpec, LocalDeviceManagement, RemoteTarget};
use crate::types::{CloseEvent, Description, FrameEvent};

/// What a link is opened for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkMode {
    /// Data link layer access for property services
    Normal,
    /// Passive bus monitor, the link never sends
    Monitor,
}

/// Receives link events. Called from the transport's own tasks.
pub trait LinkListener: Send + Sync {
    fn link_closed(&self, event: &CloseEvent);

    fn indication(&self, _event: &FrameEvent) {}

    fn confirmation(&self, _event: &FrameEvent) {}
}

/// An open network link to the bus.
#[async_trait]
pub trait Link: Send + Sync {
    fn name(&self) -> String;

    fn is_open(&self) -> bool;

    fn add_listener(&self, listener: Arc<dyn LinkListener>);

    /// Close on user request. Closing a closed link does nothing.
    async fn close(&self);
}

/// Receives the close notification of an adapter.
pub trait AdapterListener: Send + Sync {
    fn adapter_closed(&self, event: &CloseEvent);
}

/// Property services on one interface object server.
///
/// Element indices start at 1; reading element 0 returns the current number
/// of elements as a 2 byte value.
#[async_trait]
pub trait Adapter: Send + Sync {
    fn name(&self) -> String;

    fn is_open(&self) -> bool;

    /// Read `count` elements starting at `start`.
    async fn read(
        &self,
        object_index: u16,
        pid: u16,
        start: u16,
        count: u16,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Write `count` elements starting at `start`.
    async fn write(
        &self,
        object_index: u16,
        pid: u16,
        start: u16,
        count: u16,
        data: &[u8],
    ) -> Result<(), ProtocolError>;

    async fn describe(&self, object_index: u16, pid: u16) -> Result<Description, ProtocolError>;

    async fn describe_by_index(
        &self,
        object_index: u16,
        property_index: u16,
    ) -> Result<Description, ProtocolError>;

    /// Close on user request. Closing a closed adapter does nothing.
    async fn close(&self);
}

/// Opens links and adapters for a session.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open_link(
        &self,
        spec: &LinkSpec,
        mode: LinkMode,
    ) -> Result<Arc<dyn Link>, TransportError>;

    async fn open_local_adapter(
        &self,
        spec: &LocalDeviceManagement,
        listener: Arc<dyn AdapterListener>,
    ) -> Result<Arc<dyn Adapter>, TransportError>;

    async fn open_remote_adapter(
        &self,
        link: Arc<dyn Link>,
        target: &RemoteTarget,
        listener: Arc<dyn AdapterListener>,
    ) -> Result<Arc<dyn Adapter>, TransportError>;
}
