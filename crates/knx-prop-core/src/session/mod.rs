//! Property access session.
//!
//! A session owns one adapter and, for remote access, the link below it. It
//! is opened from a validated [`AccessSpec`], serves the property operations
//! of the interpreter and is closed exactly once.

pub mod config;
pub mod interactive;
pub mod interpreter;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::device::{Adapter, AdapterListener, Connector, Link, LinkMode};
use crate::error::{CoreError, ProtocolError, Result};
use crate::protocol::pdt::{self, Pdt};
use crate::sink::Sink;
use crate::storage::Catalog;
use crate::types::{CloseEvent, Description};

use self::config::{AccessSpec, LinkSpec, RemoteTarget};

/// Logs adapter close events and stops the session on asynchronous close.
struct CloseListener {
    sink: Arc<dyn Sink>,
    token: CancellationToken,
}

impl AdapterListener for CloseListener {
    fn adapter_closed(&self, event: &CloseEvent) {
        self.sink
            .info(&format!("connection closed ({})", event.reason));
        if !event.is_user_request() {
            info!(initiator = ?event.initiator, reason = %event.reason, "Connection closed by peer");
            self.token.cancel();
        }
    }
}

/// An open property access session.
pub struct Session {
    adapter: Arc<dyn Adapter>,
    link: Option<Arc<dyn Link>>,
    catalog: Catalog,
    token: CancellationToken,
    closed: AtomicBool,
}

impl Session {
    /// Open the adapter described by `spec`.
    ///
    /// The session token is a child of `shutdown`; it is cancelled when the
    /// connection closes without a user request.
    pub async fn open(
        spec: &AccessSpec,
        catalog: Catalog,
        connector: &dyn Connector,
        sink: Arc<dyn Sink>,
        shutdown: &CancellationToken,
    ) -> Result<Self> {
        let token = shutdown.child_token();
        let listener: Arc<dyn AdapterListener> = Arc::new(CloseListener {
            sink,
            token: token.clone(),
        });

        let (adapter, link) = match spec {
            AccessSpec::LocalDeviceManagement(local) => {
                (connector.open_local_adapter(local, listener).await?, None)
            }
            AccessSpec::RemoteTunneling { endpoints, target } => {
                let link_spec = LinkSpec::Tunneling {
                    endpoints: endpoints.clone(),
                    medium: target.medium,
                };
                open_remote(connector, &link_spec, target, listener).await?
            }
            AccessSpec::RemoteRouting { endpoints, target } => {
                let link_spec = LinkSpec::Routing {
                    endpoints: endpoints.clone(),
                    medium: target.medium,
                };
                open_remote(connector, &link_spec, target, listener).await?
            }
            AccessSpec::RemoteSerial { port, target } => {
                let link_spec = LinkSpec::Serial {
                    port: port.clone(),
                    medium: target.medium,
                };
                open_remote(connector, &link_spec, target, listener).await?
            }
        };
        info!(adapter = %adapter.name(), "Adapter opened");

        Ok(Self {
            adapter,
            link,
            catalog,
            token,
            closed: AtomicBool::new(false),
        })
    }

    /// Token cancelled on shutdown or asynchronous close.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst) || !self.adapter.is_open()
    }

    /// Close the adapter, then the link.
    ///
    /// Only the first call closes anything; returns whether this call did.
    pub async fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.adapter.close().await;
        if let Some(link) = &self.link {
            link.close().await;
        }
        debug!(adapter = %self.adapter.name(), "Session closed");
        true
    }

    // ==================== Property operations ====================

    /// Read raw data of `count` elements.
    pub async fn read_raw(
        &self,
        object_index: u16,
        pid: u16,
        start: u16,
        count: u16,
    ) -> Result<Vec<u8>> {
        self.ensure_open()?;
        self.adapter
            .read(object_index, pid, start, count)
            .await
            .map_err(closed_or_protocol)
    }

    /// Read `count` elements translated by their data type.
    pub async fn read_translated(
        &self,
        object_index: u16,
        pid: u16,
        start: u16,
        count: u16,
    ) -> Result<Vec<String>> {
        let pdt = self.resolve_pdt(object_index, pid).await?;
        let data = self.read_raw(object_index, pid, start, count).await?;
        Ok(pdt::format_elements(pdt, &data, usize::from(count))?)
    }

    /// Write one element given in its textual form.
    pub async fn write_value(
        &self,
        object_index: u16,
        pid: u16,
        start: u16,
        value: &str,
    ) -> Result<()> {
        let pdt = self.resolve_pdt(object_index, pid).await?;
        let data = pdt::parse_value(pdt, value)?;
        self.write_data(object_index, pid, start, 1, &data).await
    }

    /// Write raw data of `count` elements.
    pub async fn write_data(
        &self,
        object_index: u16,
        pid: u16,
        start: u16,
        count: u16,
        data: &[u8],
    ) -> Result<()> {
        self.ensure_open()?;
        self.adapter
            .write(object_index, pid, start, count, data)
            .await
            .map_err(closed_or_protocol)
    }

    pub async fn describe(&self, object_index: u16, pid: u16) -> Result<Description> {
        self.ensure_open()?;
        self.adapter
            .describe(object_index, pid)
            .await
            .map_err(closed_or_protocol)
    }

    pub async fn describe_by_index(
        &self,
        object_index: u16,
        property_index: u16,
    ) -> Result<Description> {
        self.ensure_open()?;
        self.adapter
            .describe_by_index(object_index, property_index)
            .await
            .map_err(closed_or_protocol)
    }

    /// Scan property descriptions.
    ///
    /// Without `all` only the object type property (index 0) of each object
    /// is returned. Without an object index every interface object is
    /// scanned until the first missing one.
    pub async fn scan(&self, object_index: Option<u16>, all: bool) -> Result<Vec<Description>> {
        let (first, last) = match object_index {
            Some(oi) => (oi, oi),
            None => (0, u16::MAX),
        };

        let mut descriptions = Vec::new();
        'objects: for oi in first..=last {
            if self.token.is_cancelled() {
                return Err(CoreError::SessionClosed);
            }
            let mut property_index = 0u16;
            loop {
                match self.describe_by_index(oi, property_index).await {
                    Ok(desc) => descriptions.push(desc),
                    Err(CoreError::Protocol(ProtocolError::NoSuchObject(_)))
                        if object_index.is_none() =>
                    {
                        break 'objects;
                    }
                    Err(CoreError::Protocol(ProtocolError::NoSuchPropertyIndex { .. })) => break,
                    Err(e) => return Err(e),
                }
                if !all || property_index == u16::MAX {
                    break;
                }
                property_index += 1;
            }
        }
        Ok(descriptions)
    }

    // Reported PDT wins over the catalog default.
    async fn resolve_pdt(&self, object_index: u16, pid: u16) -> Result<Pdt> {
        let desc = self.describe(object_index, pid).await?;
        desc.pdt
            .or_else(|| {
                self.catalog
                    .lookup(desc.object_type, pid)
                    .and_then(|def| def.pdt)
            })
            .ok_or_else(|| ProtocolError::TranslationUnsupported("unknown".to_string()).into())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(CoreError::SessionClosed)
        } else {
            Ok(())
        }
    }
}

async fn open_remote(
    connector: &dyn Connector,
    link_spec: &LinkSpec,
    target: &RemoteTarget,
    listener: Arc<dyn AdapterListener>,
) -> Result<(Arc<dyn Adapter>, Option<Arc<dyn Link>>)> {
    let link = connector.open_link(link_spec, LinkMode::Normal).await?;
    info!(link = %link.name(), "Link opened");
    match connector
        .open_remote_adapter(link.clone(), target, listener)
        .await
    {
        Ok(adapter) => Ok((adapter, Some(link))),
        Err(e) => {
            link.close().await;
            Err(e.into())
        }
    }
}

fn closed_or_protocol(e: ProtocolError) -> CoreError {
    match e {
        ProtocolError::Closed => CoreError::SessionClosed,
        e => CoreError::Protocol(e),
    }
}

/// Outcome of a tool run, reported once on completion.
#[derive(Debug, Default)]
pub struct Completion {
    pub canceled: bool,
    pub error: Option<CoreError>,
}

impl Completion {
    /// Report cancellation at info and an unexpected error at error severity.
    pub fn report(&self, sink: &dyn Sink, canceled_message: &str) {
        if self.canceled {
            sink.info(canceled_message);
        }
        if let Some(e) = &self.error {
            sink.error(&format!("on completion: {}", e));
        }
    }
}
