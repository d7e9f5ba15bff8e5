//! Connection options and their validation into an access specification.
//!
//! Options are collected by the front end into [`ConnectionOptions`] and
//! validated once, before any I/O, into an [`AccessSpec`] that names exactly
//! one way of reaching the device.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, ToSocketAddrs};

use crate::error::ConfigError;
use crate::types::{AuthorizeKey, IndividualAddress, Medium};

/// Default KNXnet/IP UDP port.
pub const DEFAULT_PORT: u16 = 3671;

/// Connection category chosen by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Local device management of the KNXnet/IP server itself
    Local,
    /// Remote property services of the device with this address
    Remote(IndividualAddress),
}

/// Every recognized connection option.
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    pub mode: Option<AccessMode>,
    pub host: Option<String>,
    pub port: u16,
    pub local_host: Option<String>,
    /// 0 lets the system assign the port
    pub local_port: u16,
    pub nat: bool,
    /// Serial port index or device name for FT1.2
    pub serial: Option<String>,
    pub medium: Medium,
    pub emulate_write_enable: bool,
    pub routing: bool,
    /// Connection oriented remote access
    pub connect: bool,
    pub authorize: Option<AuthorizeKey>,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            mode: None,
            host: None,
            port: DEFAULT_PORT,
            local_host: None,
            local_port: 0,
            nat: false,
            serial: None,
            medium: Medium::default(),
            emulate_write_enable: false,
            routing: false,
            connect: false,
            authorize: None,
        }
    }
}

impl ConnectionOptions {
    /// Validate the options into an access specification.
    ///
    /// Checks run in a fixed order so the first problem reported is stable:
    /// connection category, endpoint, serial without remote, local without
    /// host, host resolution.
    pub fn validate(&self) -> Result<AccessSpec, ConfigError> {
        let mode = self.mode.ok_or(ConfigError::NoConnectionCategory)?;
        if self.host.is_none() && self.serial.is_none() {
            return Err(ConfigError::NoEndpoint);
        }
        if self.serial.is_some() && !matches!(mode, AccessMode::Remote(_)) {
            return Err(ConfigError::RemoteRequiredForSerial);
        }

        match mode {
            AccessMode::Local => {
                let host = self.host.as_deref().ok_or(ConfigError::LocalRequiresHost)?;
                Ok(AccessSpec::LocalDeviceManagement(LocalDeviceManagement {
                    endpoints: self.ip_endpoints(host)?,
                    emulate_write_enable: self.emulate_write_enable,
                }))
            }
            AccessMode::Remote(address) => {
                let target = RemoteTarget {
                    address,
                    medium: self.medium,
                    access: self.remote_access(),
                };
                if let Some(port) = &self.serial {
                    return Ok(AccessSpec::RemoteSerial {
                        port: SerialPort::parse(port),
                        target,
                    });
                }
                let host = self.host.as_deref().ok_or(ConfigError::NoEndpoint)?;
                let endpoints = self.ip_endpoints(host)?;
                if self.routing {
                    Ok(AccessSpec::RemoteRouting { endpoints, target })
                } else {
                    Ok(AccessSpec::RemoteTunneling { endpoints, target })
                }
            }
        }
    }

    /// Link used by the bus monitor; the connection category is ignored.
    pub fn monitor_link(&self) -> Result<LinkSpec, ConfigError> {
        if let Some(port) = &self.serial {
            return Ok(LinkSpec::Serial {
                port: SerialPort::parse(port),
                medium: self.medium,
            });
        }
        let host = self.host.as_deref().ok_or(ConfigError::NoEndpoint)?;
        Ok(LinkSpec::Tunneling {
            endpoints: self.ip_endpoints(host)?,
            medium: self.medium,
        })
    }

    fn remote_access(&self) -> RemoteAccess {
        match &self.authorize {
            Some(key) => RemoteAccess::Authorized(key.clone()),
            None if self.connect => RemoteAccess::ConnectionOriented,
            None => RemoteAccess::Connectionless,
        }
    }

    fn ip_endpoints(&self, host: &str) -> Result<IpEndpoints, ConfigError> {
        let server = resolve(host, self.port)?;
        let local = match &self.local_host {
            Some(local) => Some(resolve(local, self.local_port)?),
            None if self.local_port != 0 => Some(SocketAddr::new(
                IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                self.local_port,
            )),
            None => None,
        };
        Ok(IpEndpoints {
            local,
            server,
            nat: self.nat,
        })
    }
}

fn resolve(host: &str, port: u16) -> Result<SocketAddr, ConfigError> {
    (host, port)
        .to_socket_addrs()
        .ok()
        .and_then(|mut addrs| addrs.next())
        .ok_or_else(|| ConfigError::UnresolvableHost {
            host: host.to_string(),
        })
}

/// Validated description of how the device is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessSpec {
    LocalDeviceManagement(LocalDeviceManagement),
    RemoteTunneling {
        endpoints: IpEndpoints,
        target: RemoteTarget,
    },
    RemoteRouting {
        endpoints: IpEndpoints,
        target: RemoteTarget,
    },
    RemoteSerial {
        port: SerialPort,
        target: RemoteTarget,
    },
}

/// Local device management of a KNXnet/IP server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalDeviceManagement {
    pub endpoints: IpEndpoints,
    /// Check write-enable of a property before writing
    pub emulate_write_enable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpEndpoints {
    pub local: Option<SocketAddr>,
    pub server: SocketAddr,
    pub nat: bool,
}

/// Device addressed by remote property services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    pub address: IndividualAddress,
    pub medium: Medium,
    pub access: RemoteAccess,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteAccess {
    /// Connection oriented, authorizing with the key first
    Authorized(AuthorizeKey),
    ConnectionOriented,
    Connectionless,
}

/// FT1.2 serial port identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SerialPort {
    Index(u32),
    Device(String),
}

impl SerialPort {
    /// Numeric identifiers select a port by index, anything else is a device name.
    pub fn parse(id: &str) -> Self {
        match id.parse::<u32>() {
            Ok(index) => SerialPort::Index(index),
            Err(_) => SerialPort::Device(id.to_string()),
        }
    }
}

impl fmt::Display for SerialPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerialPort::Index(index) => write!(f, "port {}", index),
            SerialPort::Device(name) => write!(f, "{}", name),
        }
    }
}

/// Network link to open on a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkSpec {
    Tunneling { endpoints: IpEndpoints, medium: Medium },
    Routing { endpoints: IpEndpoints, medium: Medium },
    Serial { port: SerialPort, medium: Medium },
}

impl LinkSpec {
    pub fn medium(&self) -> Medium {
        match self {
            LinkSpec::Tunneling { medium, .. }
            | LinkSpec::Routing { medium, .. }
            | LinkSpec::Serial { medium, .. } => *medium,
        }
    }
}

impl fmt::Display for LinkSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkSpec::Tunneling { endpoints, .. } => {
                write!(f, "KNXnet/IP tunneling {}", endpoints.server)
            }
            LinkSpec::Routing { endpoints, .. } => {
                write!(f, "KNXnet/IP routing {}", endpoints.server)
            }
            LinkSpec::Serial { port, .. } => write!(f, "FT1.2 serial {}", port),
        }
    }
}
