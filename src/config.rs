//! # Board Configuration
//!
//! The board is described by a single TOML file that is read once at start-up.
//! Every field has a default matching the consumable board's firmware header,
//! so an empty file describes the stock 6x6 board.
//!
//! ## Example: TOML Configuration
//!
//! ```toml
//! [board]
//! name = "consumable-board"
//!
//! [grid]
//! row_pins = [2, 3, 4, 5, 6, 7]
//! column_pins = [8, 9, 10, 11, 12, 13]
//! on_threshold = 150
//! off_threshold = 130
//! settle_delay_us = 500
//!
//! [scan]
//! interval_ms = 100
//! full_report_every = 50
//!
//! [serial]
//! enabled = true
//! port = "/dev/ttyACM0"
//! baud = 9600
//! format = "lines"
//!
//! [network]
//! mac = "74:39:70:2D:30:31"
//! ip = "192.168.1.5"
//! http_port = 80
//! # bind address for the HTTP API, defaults to 0.0.0.0:http_port
//! # http_listen = "127.0.0.1:8080"
//! push_target = "192.168.1.10:5555"
//! push_format = "binary"
//!
//! [simulator]
//! filled = [[2, 3], [0, 0]]
//! noise = 6
//! ```
//!
//! See `src/scanner/grid.rs` for the validated, immutable [`GridConfig`] built from `[grid]`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::reporter::wire::WireFormat;
use crate::scanner::grid::{GridConfig, PinId};
use crate::scanner::thresholder::Thresholds;

/// Gap between the on and off thresholds when `off_threshold` is not given.
pub const DEFAULT_HYSTERESIS_MARGIN: u8 = 20;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("grid has no row pins")]
    NoRows,
    #[error("grid has no column pins")]
    NoColumns,
    #[error("too many {kind} pins: {count} (max {max})")]
    TooManyPins {
        kind: &'static str,
        count: usize,
        max: usize,
    },
    #[error("pin {0} is configured as both a row and a column pin")]
    SharedPin(PinId),
    #[error("pin {pin} appears more than once in the {kind} pins")]
    DuplicatePin { kind: &'static str, pin: PinId },
    #[error("off threshold {off} must be below on threshold {on}")]
    InvalidHysteresis { on: u8, off: u8 },
    #[error("settle delay must be between 1 and {max} us, got {got}")]
    InvalidSettleDelay { got: u32, max: u32 },
    #[error("scan interval must be non-zero")]
    InvalidScanInterval,
    #[error("invalid MAC address '{0}'")]
    InvalidMac(String),
    #[error("simulator {field} must be within [0, 1], got {value}")]
    InvalidProbability { field: &'static str, value: f64 },
}

/// Top-level configuration for one board process.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub board: BoardConfig,
    #[serde(default)]
    pub grid: GridSection,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub simulator: SimulatorConfig,
}

impl Config {
    /// Builds the immutable grid description, failing on any topology or threshold error.
    pub fn grid_config(&self) -> Result<GridConfig, ConfigError> {
        let off = self
            .grid
            .off_threshold
            .unwrap_or_else(|| self.grid.on_threshold.saturating_sub(DEFAULT_HYSTERESIS_MARGIN));
        let thresholds = Thresholds::new(self.grid.on_threshold, off)?;
        GridConfig::new(
            &self.grid.row_pins,
            &self.grid.column_pins,
            thresholds,
            self.grid.settle_delay_us,
        )
    }

    /// Checks every section. Called once at start-up; any error is fatal.
    pub fn validate(&self) -> Result<GridConfig, ConfigError> {
        let grid = self.grid_config()?;
        if self.scan.interval_ms == 0 {
            return Err(ConfigError::InvalidScanInterval);
        }
        for (field, value) in [
            ("fault_rate", self.simulator.fault_rate),
            ("toggle_rate", self.simulator.toggle_rate),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidProbability { field, value });
            }
        }
        Ok(grid)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BoardConfig {
    #[serde(default = "default_board_name")]
    pub name: String,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            name: default_board_name(),
        }
    }
}

/// Raw `[grid]` section as written in the file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GridSection {
    #[serde(default = "default_row_pins")]
    pub row_pins: Vec<PinId>,
    #[serde(default = "default_column_pins")]
    pub column_pins: Vec<PinId>,
    #[serde(default = "default_on_threshold")]
    pub on_threshold: u8,
    #[serde(default)]
    pub off_threshold: Option<u8>,
    #[serde(default = "default_settle_delay_us")]
    pub settle_delay_us: u32,
}

impl Default for GridSection {
    fn default() -> Self {
        Self {
            row_pins: default_row_pins(),
            column_pins: default_column_pins(),
            on_threshold: default_on_threshold(),
            off_threshold: None,
            settle_delay_us: default_settle_delay_us(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScanConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Push a full snapshot every N completed passes; 0 disables it.
    #[serde(default)]
    pub full_report_every: u64,
    #[serde(default = "default_outbox_capacity")]
    pub outbox_capacity: usize,
}

impl ScanConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            full_report_every: 0,
            outbox_capacity: default_outbox_capacity(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SerialConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_serial_port")]
    pub port: String,
    #[serde(default = "default_baud")]
    pub baud: u32,
    #[serde(default = "default_serial_format")]
    pub format: WireFormat,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_serial_port(),
            baud: default_baud(),
            format: default_serial_format(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
    #[serde(default)]
    pub mac: MacAddress,
    /// Board identity reported by the status endpoint. Never used as a bind address.
    #[serde(default = "default_ip")]
    pub ip: Ipv4Addr,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Overrides `0.0.0.0:http_port` as the HTTP bind address.
    #[serde(default)]
    pub http_listen: Option<SocketAddr>,
    /// UDP destination for change pushes.
    #[serde(default)]
    pub push_target: Option<SocketAddr>,
    #[serde(default)]
    pub push_format: WireFormat,
}

impl NetworkConfig {
    pub fn http_addr(&self) -> SocketAddr {
        self.http_listen
            .unwrap_or_else(|| SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.http_port)))
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            mac: MacAddress::default(),
            ip: default_ip(),
            http_port: default_http_port(),
            http_listen: None,
            push_target: None,
            push_format: WireFormat::default(),
        }
    }
}

/// Scene for the simulated matrix used on hosts without sensor hardware.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulatorConfig {
    /// Cells (row, column) that start out filled.
    #[serde(default)]
    pub filled: Vec<(usize, usize)>,
    #[serde(default = "default_on_level")]
    pub on_level: u8,
    #[serde(default = "default_off_level")]
    pub off_level: u8,
    #[serde(default = "default_noise")]
    pub noise: u8,
    /// Probability that a single column read fails.
    #[serde(default)]
    pub fault_rate: f64,
    /// Probability per pass that one random slot is filled or emptied.
    #[serde(default)]
    pub toggle_rate: f64,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            filled: Vec::new(),
            on_level: default_on_level(),
            off_level: default_off_level(),
            noise: default_noise(),
            fault_rate: 0.0,
            toggle_rate: 0.0,
            seed: None,
        }
    }
}

/// Ethernet hardware address, written as `74:39:70:2D:30:31`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddress(pub [u8; 6]);

impl Default for MacAddress {
    fn default() -> Self {
        MacAddress([0x74, 0x39, 0x70, 0x2D, 0x30, 0x31])
    }
}

impl FromStr for MacAddress {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 6];
        let mut parts = s.split([':', '-']);
        for byte in bytes.iter_mut() {
            let part = parts
                .next()
                .filter(|p| p.len() == 2)
                .ok_or_else(|| ConfigError::InvalidMac(s.to_string()))?;
            *byte = u8::from_str_radix(part, 16)
                .map_err(|_| ConfigError::InvalidMac(s.to_string()))?;
        }
        if parts.next().is_some() {
            return Err(ConfigError::InvalidMac(s.to_string()));
        }
        Ok(MacAddress(bytes))
    }
}

impl TryFrom<String> for MacAddress {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MacAddress> for String {
    fn from(mac: MacAddress) -> Self {
        mac.to_string()
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

fn default_board_name() -> String { "consumable-board".to_string() }
fn default_row_pins() -> Vec<PinId> { vec![2, 3, 4, 5, 6, 7] }
fn default_column_pins() -> Vec<PinId> { vec![8, 9, 10, 11, 12, 13] }
fn default_on_threshold() -> u8 { 150 }
fn default_settle_delay_us() -> u32 { 500 }
fn default_interval_ms() -> u64 { 100 }
fn default_outbox_capacity() -> usize { 64 }
fn default_serial_port() -> String { "/dev/ttyACM0".to_string() }
fn default_baud() -> u32 { 9600 }
fn default_serial_format() -> WireFormat { WireFormat::Lines }
fn default_ip() -> Ipv4Addr { Ipv4Addr::new(192, 168, 1, 5) }
fn default_http_port() -> u16 { 80 }
fn default_on_level() -> u8 { 220 }
fn default_off_level() -> u8 { 40 }
fn default_noise() -> u8 { 6 }

pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::error!("Failed to parse config TOML: {}", e);
                Err(ConfigError::Toml(e))
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file '{}': {}", path.display(), e);
            Err(ConfigError::Io(e))
        }
    }
}
