//! Transport selection.
//!
//! This build links no KNXnet/IP or FT1.2 driver. Without `--simulate` every
//! open fails with a transport error naming the requested link; with it the
//! in-memory device server answers instead.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use knx_prop_core::device::memory::{MemoryConnector, MemoryDevice};
use knx_prop_core::device::{Adapter, AdapterListener, Connector, Link, LinkMode};
use knx_prop_core::error::{CoreError, TransportError};
use knx_prop_core::session::config::{LinkSpec, LocalDeviceManagement, RemoteTarget};

/// Connector without any transport driver.
#[derive(Debug, Default)]
pub struct NoDriverConnector;

#[async_trait]
impl Connector for NoDriverConnector {
    async fn open_link(
        &self,
        spec: &LinkSpec,
        _mode: LinkMode,
    ) -> Result<Arc<dyn Link>, TransportError> {
        Err(TransportError::NoDriver(spec.to_string()))
    }

    async fn open_local_adapter(
        &self,
        spec: &LocalDeviceManagement,
        _listener: Arc<dyn AdapterListener>,
    ) -> Result<Arc<dyn Adapter>, TransportError> {
        Err(TransportError::NoDriver(format!(
            "KNXnet/IP device management {}",
            spec.endpoints.server
        )))
    }

    async fn open_remote_adapter(
        &self,
        _link: Arc<dyn Link>,
        target: &RemoteTarget,
        _listener: Arc<dyn AdapterListener>,
    ) -> Result<Arc<dyn Adapter>, TransportError> {
        Err(TransportError::NoDriver(format!(
            "remote property service {}",
            target.address
        )))
    }
}

/// Pick the connector for this run.
pub fn select(simulate: Option<&Path>) -> Result<Box<dyn Connector>, CoreError> {
    match simulate {
        Some(path) => {
            let device = MemoryDevice::load(path)?;
            info!(device = %path.display(), "Using simulated device");
            Ok(Box::new(MemoryConnector::new(device)))
        }
        None => Ok(Box::new(NoDriverConnector)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knx_prop_core::session::config::SerialPort;
    use knx_prop_core::types::Medium;
    use std::io::Write;

    #[tokio::test]
    async fn test_no_driver_names_link() {
        let spec = LinkSpec::Serial {
            port: SerialPort::Index(0),
            medium: Medium::Tp1,
        };
        let err = NoDriverConnector
            .open_link(&spec, LinkMode::Monitor)
            .await
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "no driver for FT1.2 serial port 0 available");
    }

    #[tokio::test]
    async fn test_select_simulated_device() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"objects": [], "traffic": []}}"#).unwrap();

        let connector = select(Some(file.path())).unwrap();
        let spec = LinkSpec::Serial {
            port: SerialPort::Index(0),
            medium: Medium::Tp1,
        };
        assert!(connector.open_link(&spec, LinkMode::Monitor).await.is_ok());
    }

    #[test]
    fn test_select_missing_device_file() {
        let result = select(Some(Path::new("/nonexistent/device.json")));
        assert!(matches!(result, Err(CoreError::Load(_))));
    }
}
