//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use knx_prop_core::error::ConfigError;
use knx_prop_core::session::config::{AccessMode, ConnectionOptions, DEFAULT_PORT};

/// knx-prop - KNX property access and bus monitoring
#[derive(Parser, Debug)]
#[command(name = "knx-prop")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Property definitions file (JSON)
    #[arg(long, global = true, env = "KNX_PROP_DEFINITIONS")]
    pub definitions: Option<PathBuf>,

    /// Serve requests from a simulated device file instead of a transport
    #[arg(long, global = true, value_name = "DEVICE_JSON")]
    pub simulate: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a single property command
    Property(PropertyArgs),

    /// Interactive property client
    Client,

    /// Passive bus monitor
    Monitor(MonitorArgs),
}

// ==================== Connection ====================

#[derive(Args, Debug)]
pub struct ConnectionArgs {
    /// Local device management of the KNXnet/IP server
    #[arg(long, global = true, conflicts_with = "remote")]
    pub local: bool,

    /// Remote property services of the device with this individual address
    #[arg(long, global = true, value_name = "ADDRESS")]
    pub remote: Option<String>,

    /// KNXnet/IP server host
    #[arg(long, global = true, env = "KNX_PROP_HOST")]
    pub host: Option<String>,

    /// KNXnet/IP server port
    #[arg(long, global = true, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Local endpoint host
    #[arg(long = "localhost", global = true, value_name = "HOST")]
    pub local_host: Option<String>,

    /// Local endpoint port (0 = system assigned)
    #[arg(long = "localport", global = true, default_value_t = 0, value_name = "PORT")]
    pub local_port: u16,

    /// Use NAT aware endpoints
    #[arg(long, global = true)]
    pub nat: bool,

    /// FT1.2 serial port index or device name
    #[arg(long, global = true, value_name = "PORT")]
    pub serial: Option<String>,

    /// KNX medium (tp0, tp1, p110, p132, rf)
    #[arg(long, global = true, default_value = "tp1")]
    pub medium: String,

    /// Check write-enable in local device management
    #[arg(long = "emulatewriteenable", global = true)]
    pub emulate_write_enable: bool,

    /// Use KNXnet/IP routing instead of tunneling
    #[arg(long, global = true)]
    pub routing: bool,

    /// Connection oriented remote access
    #[arg(long, global = true)]
    pub connect: bool,

    /// Authorization key for remote access
    #[arg(long, global = true, value_name = "KEY")]
    pub authorize: Option<String>,
}

impl ConnectionArgs {
    /// Parse the raw option values into connection options.
    pub fn options(&self) -> Result<ConnectionOptions, ConfigError> {
        let mode = match (&self.remote, self.local) {
            (Some(address), _) => Some(AccessMode::Remote(address.parse()?)),
            (None, true) => Some(AccessMode::Local),
            (None, false) => None,
        };
        Ok(ConnectionOptions {
            mode,
            host: self.host.clone(),
            port: self.port,
            local_host: self.local_host.clone(),
            local_port: self.local_port,
            nat: self.nat,
            serial: self.serial.clone(),
            medium: self.medium.parse()?,
            emulate_write_enable: self.emulate_write_enable,
            routing: self.routing,
            connect: self.connect,
            authorize: self.authorize.as_deref().map(str::parse).transpose()?,
        })
    }
}

// ==================== Property ====================

#[derive(Args, Debug)]
pub struct PropertyArgs {
    /// Command and arguments, e.g. `get 0 56` or `scan all`
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

// ==================== Monitor ====================

#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// Prefix every frame with its reception time
    #[arg(short, long)]
    pub timestamps: bool,
}
