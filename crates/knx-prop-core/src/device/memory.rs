//! In-memory interface object server.
//!
//! Serves adapters and links from a device image loaded from JSON or built in
//! code. Backs the `--simulate` option of the tools and the tests.
//!
//! A device file looks like:
//!
//! ```json
//! {
//!   "objects": [
//!     { "objectType": 0, "properties": [
//!       { "pid": 1, "pdt": 4, "data": "0000", "writeEnabled": false },
//!       { "pid": 56, "pdt": 4, "maxElements": 1, "data": "00fe" }
//!     ]}
//!   ],
//!   "traffic": [ { "raw": "2900bce0110a0a0102000080", "decoded": "1.1.10->1/2/0 write" } ]
//! }
//! ```

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Deserializer};
use tracing::debug;

use super::{Adapter, AdapterListener, Connector, Link, LinkListener, LinkMode};
use crate::error::{LoadError, ProtocolError, TransportError};
use crate::protocol::pdt::Pdt;
use crate::session::config::{LinkSpec, LocalDeviceManagement, RemoteTarget};
use crate::types::{CloseEvent, CloseInitiator, Description, Frame, FrameEvent};

// ==================== Device image ====================

/// One property of an interface object.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryProperty {
    pub pid: u16,
    pub pdt: Pdt,
    #[serde(default = "default_max_elements")]
    pub max_elements: u16,
    #[serde(default)]
    pub read_level: u8,
    #[serde(default)]
    pub write_level: u8,
    #[serde(default = "default_true")]
    pub write_enabled: bool,
    /// Descriptions leave the PDT out when false
    #[serde(default = "default_true")]
    pub report_pdt: bool,
    #[serde(default, deserialize_with = "hex_bytes")]
    pub data: Vec<u8>,
}

impl MemoryProperty {
    fn element_size(&self) -> usize {
        self.pdt.element_size().unwrap_or(1)
    }

    fn current_elements(&self) -> u16 {
        u16::try_from(self.data.len() / self.element_size()).unwrap_or(u16::MAX)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryObject {
    pub object_type: u16,
    #[serde(default)]
    pub properties: Vec<MemoryProperty>,
}

/// A frame replayed to monitor links.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordedFrame {
    #[serde(deserialize_with = "hex_bytes")]
    pub raw: Vec<u8>,
    #[serde(default)]
    pub decoded: Option<String>,
    #[serde(default)]
    pub confirmation: bool,
}

/// Device image served by a [`MemoryConnector`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemoryDevice {
    #[serde(default)]
    pub objects: Vec<MemoryObject>,
    #[serde(default)]
    pub traffic: Vec<RecordedFrame>,
}

fn default_max_elements() -> u16 {
    1
}

fn default_true() -> bool {
    true
}

fn hex_bytes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let text = String::deserialize(deserializer)?;
    let digits = text.strip_prefix("0x").unwrap_or(&text);
    hex::decode(digits)
        .map_err(|e| serde::de::Error::custom(format!("invalid hex data '{}': {}", text, e)))
}

impl MemoryDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a device image from a JSON file.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content).map_err(|source| LoadError::Malformed {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Append an interface object; following properties are added to it.
    pub fn object(mut self, object_type: u16) -> Self {
        self.objects.push(MemoryObject {
            object_type,
            properties: Vec::new(),
        });
        self
    }

    /// Append a writable property to the last object.
    pub fn property(mut self, pid: u16, pdt: Pdt, max_elements: u16, data: &[u8]) -> Self {
        if self.objects.is_empty() {
            self = self.object(0);
        }
        if let Some(object) = self.objects.last_mut() {
            object.properties.push(MemoryProperty {
                pid,
                pdt,
                max_elements,
                read_level: 0,
                write_level: 0,
                write_enabled: true,
                report_pdt: true,
                data: data.to_vec(),
            });
        }
        self
    }

    /// Mark the last property read-only.
    pub fn read_only(mut self) -> Self {
        if let Some(property) = self.last_property_mut() {
            property.write_enabled = false;
        }
        self
    }

    /// Leave the PDT of the last property out of its descriptions.
    pub fn without_pdt(mut self) -> Self {
        if let Some(property) = self.last_property_mut() {
            property.report_pdt = false;
        }
        self
    }

    /// Record an indication replayed to monitor links.
    pub fn frame(mut self, raw: &[u8], decoded: Option<&str>) -> Self {
        self.traffic.push(RecordedFrame {
            raw: raw.to_vec(),
            decoded: decoded.map(str::to_string),
            confirmation: false,
        });
        self
    }

    fn last_property_mut(&mut self) -> Option<&mut MemoryProperty> {
        self.objects
            .last_mut()
            .and_then(|object| object.properties.last_mut())
    }
}

// ==================== Property services ====================

fn property(
    objects: &[MemoryObject],
    object_index: u16,
    pid: u16,
) -> Result<(usize, &MemoryObject, &MemoryProperty), ProtocolError> {
    let object = objects
        .get(usize::from(object_index))
        .ok_or(ProtocolError::NoSuchObject(object_index))?;
    object
        .properties
        .iter()
        .enumerate()
        .find(|(_, p)| p.pid == pid)
        .map(|(index, p)| (index, object, p))
        .ok_or(ProtocolError::NoSuchProperty { object_index, pid })
}

fn property_mut(
    objects: &mut [MemoryObject],
    object_index: u16,
    pid: u16,
) -> Result<&mut MemoryProperty, ProtocolError> {
    objects
        .get_mut(usize::from(object_index))
        .ok_or(ProtocolError::NoSuchObject(object_index))?
        .properties
        .iter_mut()
        .find(|p| p.pid == pid)
        .ok_or(ProtocolError::NoSuchProperty { object_index, pid })
}

fn description(
    object: &MemoryObject,
    object_index: u16,
    property_index: usize,
    property: &MemoryProperty,
) -> Description {
    Description {
        property_index: u16::try_from(property_index).unwrap_or(u16::MAX),
        object_type: object.object_type,
        object_index,
        pid: property.pid,
        pdt: property.report_pdt.then_some(property.pdt),
        current_elements: property.current_elements(),
        max_elements: property.max_elements,
        read_level: property.read_level,
        write_level: property.write_level,
        write_enabled: property.write_enabled,
    }
}

fn read_elements(
    objects: &[MemoryObject],
    object_index: u16,
    pid: u16,
    start: u16,
    count: u16,
) -> Result<Vec<u8>, ProtocolError> {
    let (_, _, property) = property(objects, object_index, pid)?;
    let current = property.current_elements();
    if start == 0 {
        return Ok(current.to_be_bytes().to_vec());
    }

    let end = u32::from(start) + u32::from(count) - 1;
    if count == 0 || end > u32::from(current) {
        return Err(ProtocolError::ElementRange {
            start,
            end,
            current,
        });
    }
    let size = property.element_size();
    Ok(property.data[(usize::from(start) - 1) * size..end as usize * size].to_vec())
}

fn write_elements(
    objects: &mut [MemoryObject],
    object_index: u16,
    pid: u16,
    start: u16,
    count: u16,
    data: &[u8],
    check_write_enable: bool,
) -> Result<(), ProtocolError> {
    let property = property_mut(objects, object_index, pid)?;
    if check_write_enable && !property.write_enabled {
        return Err(ProtocolError::WriteDisabled { pid });
    }
    let size = property.element_size();

    // element 0 sets the number of current elements
    if start == 0 {
        let &[high, low] = data else {
            return Err(ProtocolError::DataLength {
                expected: 2,
                actual: data.len(),
                count,
            });
        };
        let elements = u16::from_be_bytes([high, low]);
        if elements > property.max_elements {
            return Err(ProtocolError::MaxElements {
                end: elements.into(),
                max: property.max_elements,
            });
        }
        property.data.resize(usize::from(elements) * size, 0);
        return Ok(());
    }

    let expected = usize::from(count) * size;
    if count == 0 || data.len() != expected {
        return Err(ProtocolError::DataLength {
            expected,
            actual: data.len(),
            count,
        });
    }
    let end = u32::from(start) + u32::from(count) - 1;
    if end > u32::from(property.max_elements) {
        return Err(ProtocolError::MaxElements {
            end,
            max: property.max_elements,
        });
    }
    let current = property.current_elements();
    if u32::from(start) > u32::from(current) + 1 {
        return Err(ProtocolError::ElementRange {
            start,
            end,
            current,
        });
    }

    let offset = (usize::from(start) - 1) * size;
    if property.data.len() < offset + expected {
        property.data.resize(offset + expected, 0);
    }
    property.data[offset..offset + expected].copy_from_slice(data);
    Ok(())
}

// ==================== Adapter ====================

/// Adapter on the shared in-memory object server.
pub struct MemoryAdapter {
    name: String,
    objects: Arc<Mutex<Vec<MemoryObject>>>,
    check_write_enable: bool,
    listener: Arc<dyn AdapterListener>,
    open: AtomicBool,
    closes: AtomicUsize,
}

impl MemoryAdapter {
    /// Close with an explicit initiator, notifying the listener once.
    pub fn close_with(&self, event: CloseEvent) {
        if self.open.swap(false, Ordering::SeqCst) {
            self.closes.fetch_add(1, Ordering::SeqCst);
            debug!(adapter = %self.name, reason = %event.reason, "Adapter closed");
            self.listener.adapter_closed(&event);
        }
    }

    /// How many times the adapter was actually closed.
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<(), ProtocolError> {
        if self.open.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ProtocolError::Closed)
        }
    }
}

#[async_trait]
impl Adapter for MemoryAdapter {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn read(
        &self,
        object_index: u16,
        pid: u16,
        start: u16,
        count: u16,
    ) -> Result<Vec<u8>, ProtocolError> {
        self.ensure_open()?;
        read_elements(&self.objects.lock(), object_index, pid, start, count)
    }

    async fn write(
        &self,
        object_index: u16,
        pid: u16,
        start: u16,
        count: u16,
        data: &[u8],
    ) -> Result<(), ProtocolError> {
        self.ensure_open()?;
        write_elements(
            &mut self.objects.lock(),
            object_index,
            pid,
            start,
            count,
            data,
            self.check_write_enable,
        )
    }

    async fn describe(&self, object_index: u16, pid: u16) -> Result<Description, ProtocolError> {
        self.ensure_open()?;
        let objects = self.objects.lock();
        let (index, object, property) = property(&objects, object_index, pid)?;
        Ok(description(object, object_index, index, property))
    }

    async fn describe_by_index(
        &self,
        object_index: u16,
        property_index: u16,
    ) -> Result<Description, ProtocolError> {
        self.ensure_open()?;
        let objects = self.objects.lock();
        let object = objects
            .get(usize::from(object_index))
            .ok_or(ProtocolError::NoSuchObject(object_index))?;
        let property = object
            .properties
            .get(usize::from(property_index))
            .ok_or(ProtocolError::NoSuchPropertyIndex {
                object_index,
                property_index,
            })?;
        Ok(description(
            object,
            object_index,
            usize::from(property_index),
            property,
        ))
    }

    async fn close(&self) {
        self.close_with(CloseEvent::user_request());
    }
}

/// Closes a remote adapter together with its link.
struct CloseCascade(Weak<MemoryAdapter>);

impl LinkListener for CloseCascade {
    fn link_closed(&self, event: &CloseEvent) {
        if let Some(adapter) = self.0.upgrade() {
            adapter.close_with(event.clone());
        }
    }
}

// ==================== Link ====================

/// Link that replays recorded traffic in monitor mode.
pub struct MemoryLink {
    name: String,
    mode: LinkMode,
    traffic: Vec<RecordedFrame>,
    listeners: Mutex<Vec<Arc<dyn LinkListener>>>,
    open: AtomicBool,
    closes: AtomicUsize,
}

impl MemoryLink {
    /// Close with an explicit initiator, notifying every listener once.
    pub fn close_with(&self, event: CloseEvent) {
        if self.open.swap(false, Ordering::SeqCst) {
            self.closes.fetch_add(1, Ordering::SeqCst);
            debug!(link = %self.name, reason = %event.reason, "Link closed");
            let listeners = self.listeners.lock().clone();
            for listener in listeners {
                listener.link_closed(&event);
            }
        }
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    fn replay(&self, listener: &dyn LinkListener) {
        if self.mode != LinkMode::Monitor {
            return;
        }
        for recorded in &self.traffic {
            let event = FrameEvent {
                source: self.name.clone(),
                frame: Frame::new(recorded.raw.clone(), recorded.decoded.clone()),
                received_at: Utc::now(),
            };
            if recorded.confirmation {
                listener.confirmation(&event);
            } else {
                listener.indication(&event);
            }
        }
    }
}

#[async_trait]
impl Link for MemoryLink {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn add_listener(&self, listener: Arc<dyn LinkListener>) {
        self.listeners.lock().push(listener.clone());
        self.replay(listener.as_ref());
    }

    async fn close(&self) {
        self.close_with(CloseEvent::user_request());
    }
}

// ==================== Connector ====================

/// Connector serving one in-memory device.
///
/// Adapters opened by the same connector share the object server, so writes
/// are visible across sessions.
pub struct MemoryConnector {
    objects: Arc<Mutex<Vec<MemoryObject>>>,
    traffic: Vec<RecordedFrame>,
    refusal: Option<String>,
    adapters: Mutex<Vec<Arc<MemoryAdapter>>>,
    links: Mutex<Vec<Arc<MemoryLink>>>,
}

impl MemoryConnector {
    pub fn new(device: MemoryDevice) -> Self {
        Self {
            objects: Arc::new(Mutex::new(device.objects)),
            traffic: device.traffic,
            refusal: None,
            adapters: Mutex::new(Vec::new()),
            links: Mutex::new(Vec::new()),
        }
    }

    /// Connector whose every open fails with `reason`.
    pub fn refusing(reason: impl Into<String>) -> Self {
        Self {
            refusal: Some(reason.into()),
            ..Self::new(MemoryDevice::new())
        }
    }

    /// Adapters opened so far, in order.
    pub fn adapters(&self) -> Vec<Arc<MemoryAdapter>> {
        self.adapters.lock().clone()
    }

    /// Links opened so far, in order.
    pub fn links(&self) -> Vec<Arc<MemoryLink>> {
        self.links.lock().clone()
    }

    /// Simulate the remote endpoint closing every open link and adapter.
    pub fn disconnect(&self, reason: &str) {
        for link in self.links() {
            link.close_with(CloseEvent::new(CloseInitiator::Server, reason));
        }
        for adapter in self.adapters() {
            adapter.close_with(CloseEvent::new(CloseInitiator::Server, reason));
        }
    }

    fn check_reachable(&self, endpoint: String) -> Result<(), TransportError> {
        match &self.refusal {
            Some(message) => Err(TransportError::ConnectFailed {
                endpoint,
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }

    fn register_adapter(
        &self,
        name: String,
        check_write_enable: bool,
        listener: Arc<dyn AdapterListener>,
    ) -> Arc<MemoryAdapter> {
        let adapter = Arc::new(MemoryAdapter {
            name,
            objects: self.objects.clone(),
            check_write_enable,
            listener,
            open: AtomicBool::new(true),
            closes: AtomicUsize::new(0),
        });
        self.adapters.lock().push(adapter.clone());
        adapter
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn open_link(
        &self,
        spec: &LinkSpec,
        mode: LinkMode,
    ) -> Result<Arc<dyn Link>, TransportError> {
        self.check_reachable(spec.to_string())?;
        let traffic = match mode {
            LinkMode::Monitor => self.traffic.clone(),
            LinkMode::Normal => Vec::new(),
        };
        let link = Arc::new(MemoryLink {
            name: spec.to_string(),
            mode,
            traffic,
            listeners: Mutex::new(Vec::new()),
            open: AtomicBool::new(true),
            closes: AtomicUsize::new(0),
        });
        debug!(link = %link.name, ?mode, "Memory link opened");
        self.links.lock().push(link.clone());
        Ok(link)
    }

    async fn open_local_adapter(
        &self,
        spec: &LocalDeviceManagement,
        listener: Arc<dyn AdapterListener>,
    ) -> Result<Arc<dyn Adapter>, TransportError> {
        let server = spec.endpoints.server.to_string();
        self.check_reachable(server.clone())?;
        let adapter = self.register_adapter(
            format!("local DM {}", server),
            spec.emulate_write_enable,
            listener,
        );
        Ok(adapter)
    }

    async fn open_remote_adapter(
        &self,
        link: Arc<dyn Link>,
        target: &RemoteTarget,
        listener: Arc<dyn AdapterListener>,
    ) -> Result<Arc<dyn Adapter>, TransportError> {
        if !link.is_open() {
            return Err(TransportError::Negotiation {
                endpoint: target.address.to_string(),
                message: format!("link {} is closed", link.name()),
            });
        }
        let adapter = self.register_adapter(
            format!("remote property service {}", target.address),
            true,
            listener,
        );
        link.add_listener(Arc::new(CloseCascade(Arc::downgrade(&adapter))));
        Ok(adapter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::config::{IpEndpoints, RemoteAccess};
    use crate::types::Medium;

    #[derive(Default)]
    struct Recorder {
        closed: Mutex<Vec<CloseEvent>>,
        frames: Mutex<Vec<String>>,
    }

    impl AdapterListener for Recorder {
        fn adapter_closed(&self, event: &CloseEvent) {
            self.closed.lock().push(event.clone());
        }
    }

    impl LinkListener for Recorder {
        fn link_closed(&self, event: &CloseEvent) {
            self.closed.lock().push(event.clone());
        }

        fn indication(&self, event: &FrameEvent) {
            self.frames.lock().push(event.frame.to_string());
        }
    }

    fn endpoints() -> IpEndpoints {
        IpEndpoints {
            local: None,
            server: "127.0.0.1:3671".parse().unwrap(),
            nat: false,
        }
    }

    fn local(emulate_write_enable: bool) -> LocalDeviceManagement {
        LocalDeviceManagement {
            endpoints: endpoints(),
            emulate_write_enable,
        }
    }

    fn target() -> RemoteTarget {
        RemoteTarget {
            address: "1.1.5".parse().unwrap(),
            medium: Medium::Tp1,
            access: RemoteAccess::Connectionless,
        }
    }

    fn device() -> MemoryDevice {
        MemoryDevice::new()
            .object(0)
            .property(1, Pdt::UNSIGNED_INT, 1, &[0x00, 0x00])
            .read_only()
            .property(52, Pdt::UNSIGNED_INT, 4, &[0x00, 0x0a, 0x01, 0xff])
            .object(11)
            .property(1, Pdt::UNSIGNED_INT, 1, &[0x00, 0x0b])
    }

    #[tokio::test]
    async fn test_read_elements() {
        let connector = MemoryConnector::new(device());
        let adapter = connector
            .open_local_adapter(&local(false), Arc::new(Recorder::default()))
            .await
            .unwrap();

        assert_eq!(adapter.read(0, 52, 0, 1).await.unwrap(), vec![0x00, 0x02]);
        assert_eq!(adapter.read(0, 52, 2, 1).await.unwrap(), vec![0x01, 0xff]);
        assert!(matches!(
            adapter.read(0, 52, 2, 2).await,
            Err(ProtocolError::ElementRange { current: 2, .. })
        ));
        assert!(matches!(
            adapter.read(5, 1, 1, 1).await,
            Err(ProtocolError::NoSuchObject(5))
        ));
        assert!(matches!(
            adapter.read(1, 99, 1, 1).await,
            Err(ProtocolError::NoSuchProperty { object_index: 1, pid: 99 })
        ));
    }

    #[tokio::test]
    async fn test_write_checks() {
        let connector = MemoryConnector::new(device());
        let adapter = connector
            .open_local_adapter(&local(true), Arc::new(Recorder::default()))
            .await
            .unwrap();

        assert!(matches!(
            adapter.write(0, 1, 1, 1, &[0, 1]).await,
            Err(ProtocolError::WriteDisabled { pid: 1 })
        ));
        assert!(matches!(
            adapter.write(0, 52, 1, 2, &[0, 1]).await,
            Err(ProtocolError::DataLength { expected: 4, actual: 2, count: 2 })
        ));
        assert!(matches!(
            adapter.write(0, 52, 4, 2, &[0, 1, 0, 2]).await,
            Err(ProtocolError::MaxElements { end: 5, max: 4 })
        ));

        adapter.write(0, 52, 3, 1, &[0x12, 0x34]).await.unwrap();
        assert_eq!(adapter.read(0, 52, 0, 1).await.unwrap(), vec![0x00, 0x03]);
        assert_eq!(adapter.read(0, 52, 3, 1).await.unwrap(), vec![0x12, 0x34]);

        adapter.write(0, 52, 0, 1, &[0x00, 0x01]).await.unwrap();
        assert_eq!(adapter.describe(0, 52).await.unwrap().current_elements, 1);
    }

    #[tokio::test]
    async fn test_local_write_enable_not_emulated() {
        let connector = MemoryConnector::new(device());
        let adapter = connector
            .open_local_adapter(&local(false), Arc::new(Recorder::default()))
            .await
            .unwrap();

        adapter.write(0, 1, 1, 1, &[0x00, 0x07]).await.unwrap();
        assert_eq!(adapter.read(0, 1, 1, 1).await.unwrap(), vec![0x00, 0x07]);
    }

    #[tokio::test]
    async fn test_descriptions() {
        let connector = MemoryConnector::new(device().without_pdt());
        let adapter = connector
            .open_local_adapter(&local(false), Arc::new(Recorder::default()))
            .await
            .unwrap();

        let desc = adapter.describe(0, 52).await.unwrap();
        assert_eq!(desc.property_index, 1);
        assert_eq!(desc.object_type, 0);
        assert_eq!(desc.current_elements, 2);
        assert_eq!(desc.max_elements, 4);
        assert!(desc.write_enabled);

        let desc = adapter.describe_by_index(1, 0).await.unwrap();
        assert_eq!(desc.object_type, 11);
        assert_eq!(desc.pid, 1);
        assert_eq!(desc.pdt, None);

        assert!(matches!(
            adapter.describe_by_index(1, 1).await,
            Err(ProtocolError::NoSuchPropertyIndex { .. })
        ));
    }

    #[tokio::test]
    async fn test_link_close_cascades_to_remote_adapter() {
        let connector = MemoryConnector::new(device());
        let spec = LinkSpec::Tunneling {
            endpoints: endpoints(),
            medium: Medium::Tp1,
        };
        let link = connector.open_link(&spec, LinkMode::Normal).await.unwrap();
        let recorder = Arc::new(Recorder::default());
        let adapter = connector
            .open_remote_adapter(link.clone(), &target(), recorder.clone())
            .await
            .unwrap();

        connector.disconnect("server shutdown");

        assert!(!link.is_open());
        assert!(!adapter.is_open());
        assert!(matches!(adapter.read(0, 1, 1, 1).await, Err(ProtocolError::Closed)));
        let closed = recorder.closed.lock().clone();
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].initiator, CloseInitiator::Server);
        assert_eq!(closed[0].reason, "server shutdown");
        assert_eq!(connector.adapters()[0].close_count(), 1);
    }

    #[tokio::test]
    async fn test_remote_adapter_needs_open_link() {
        let connector = MemoryConnector::new(device());
        let spec = LinkSpec::Tunneling {
            endpoints: endpoints(),
            medium: Medium::Tp1,
        };
        let link = connector.open_link(&spec, LinkMode::Normal).await.unwrap();
        link.close().await;

        let result = connector
            .open_remote_adapter(link, &target(), Arc::new(Recorder::default()))
            .await;
        assert!(matches!(result, Err(TransportError::Negotiation { .. })));
    }

    #[tokio::test]
    async fn test_monitor_link_replays_traffic() {
        let device = MemoryDevice::new()
            .frame(&[0x29, 0x00], Some("1.1.10->1/2/0 write"))
            .frame(&[0xbc, 0xe0], None);
        let connector = MemoryConnector::new(device);
        let spec = LinkSpec::Serial {
            port: crate::session::config::SerialPort::Index(0),
            medium: Medium::Tp1,
        };

        let link = connector.open_link(&spec, LinkMode::Monitor).await.unwrap();
        let recorder = Arc::new(Recorder::default());
        link.add_listener(recorder.clone());

        assert_eq!(
            *recorder.frames.lock(),
            vec!["1.1.10->1/2/0 write".to_string(), "bce0".to_string()]
        );
    }

    #[tokio::test]
    async fn test_refusing_connector() {
        let connector = MemoryConnector::refusing("no route to host");
        let result = connector
            .open_local_adapter(&local(false), Arc::new(Recorder::default()))
            .await;
        assert!(matches!(result, Err(TransportError::ConnectFailed { .. })));
    }

    #[test]
    fn test_device_from_json() {
        let device = MemoryDevice::from_json(
            r#"{
                "objects": [
                    {"objectType": 0, "properties": [
                        {"pid": 56, "pdt": 4, "data": "0x00fe", "writeEnabled": false}
                    ]}
                ],
                "traffic": [{"raw": "2900", "confirmation": true}]
            }"#,
        )
        .unwrap();

        let property = &device.objects[0].properties[0];
        assert_eq!(property.data, vec![0x00, 0xfe]);
        assert_eq!(property.max_elements, 1);
        assert!(!property.write_enabled);
        assert!(property.report_pdt);
        assert!(device.traffic[0].confirmation);

        assert!(MemoryDevice::from_json(r#"{"objects": [{"objectType": 0, "properties": [{"pid": 1, "pdt": 4, "data": "zz"}]}]}"#).is_err());
    }
}
