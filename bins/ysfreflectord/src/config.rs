//! INI configuration loading.

use std::path::Path;
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

/// Default configuration path on Unix, matching the upstream daemon.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/YSFReflector.ini";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: ini::Error,
    },
    #[error("missing [{section}] {key}")]
    MissingKey { section: &'static str, key: &'static str },
    #[error("invalid [{section}] {key}={value}: {reason}")]
    InvalidValue {
        section: &'static str,
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// One of the six `tracing` severity levels a `FileLevel`/`DisplayLevel`
/// knob may select, plus `Off` to disable a sink entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn parse(section: &'static str, key: &'static str, value: &str) -> Result<Self, ConfigError> {
        match value.to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "error" => Ok(Self::Error),
            "warn" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(ConfigError::InvalidValue {
                section,
                key,
                value: value.to_string(),
                reason: "expected one of off/error/warn/info/debug/trace",
            }),
        }
    }

    /// The `tracing` directive this level corresponds to, or `None` for
    /// `Off` (caller should drop the sink entirely).
    pub fn as_tracing_level(self) -> Option<tracing::Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(tracing::Level::ERROR),
            LogLevel::Warn => Some(tracing::Level::WARN),
            LogLevel::Info => Some(tracing::Level::INFO),
            LogLevel::Debug => Some(tracing::Level::DEBUG),
            LogLevel::Trace => Some(tracing::Level::TRACE),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub port: u16,
    pub id: String,
    pub name: String,
    pub description: String,
    pub debug: bool,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub file_path: String,
    pub file_root: String,
    pub file_level: LogLevel,
    pub display_level: LogLevel,
}

#[derive(Debug, Clone)]
pub struct BlacklistConfig {
    pub file: String,
    pub reload_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct GeneralConfig {
    pub daemon: bool,
}

/// The fully parsed, validated configuration for one reflector instance.
#[derive(Debug, Clone)]
pub struct Config {
    pub network: NetworkConfig,
    pub log: LogConfig,
    pub blacklist: BlacklistConfig,
    pub general: GeneralConfig,
}

impl Config {
    /// Load and validate configuration from an INI file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let ini = Ini::load_from_file(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let port_str = required(&ini, "Network", "Port")?;
        let network = NetworkConfig {
            port: port_str
                .parse()
                .map_err(|_| invalid("Network", "Port", port_str, "expected a u16"))?,
            id: required(&ini, "Network", "Id")?.to_string(),
            name: required(&ini, "Network", "Name")?.to_string(),
            description: optional(&ini, "Network", "Description").unwrap_or_default(),
            debug: optional(&ini, "Network", "Debug").map(parse_bool).unwrap_or(false),
        };

        let file_level_str = required(&ini, "Log", "FileLevel")?;
        let display_level_str = required(&ini, "Log", "DisplayLevel")?;
        let log = LogConfig {
            file_path: required(&ini, "Log", "FilePath")?.to_string(),
            file_root: required(&ini, "Log", "FileRoot")?.to_string(),
            file_level: LogLevel::parse("Log", "FileLevel", file_level_str)?,
            display_level: LogLevel::parse("Log", "DisplayLevel", display_level_str)?,
        };

        let time_str = required(&ini, "Blacklist", "Time")?;
        let blacklist_time: u64 = time_str
            .parse()
            .map_err(|_| invalid("Blacklist", "Time", time_str, "expected an integer number of seconds"))?;
        let blacklist = BlacklistConfig {
            file: required(&ini, "Blacklist", "File")?.to_string(),
            reload_interval: Duration::from_secs(blacklist_time),
        };

        let general = GeneralConfig {
            daemon: optional(&ini, "General", "Daemon").map(parse_bool).unwrap_or(false),
        };

        Ok(Self {
            network,
            log,
            blacklist,
            general,
        })
    }
}

fn required<'a>(ini: &'a Ini, section: &'static str, key: &'static str) -> Result<&'a str, ConfigError> {
    ini.section(Some(section))
        .and_then(|s| s.get(key))
        .ok_or(ConfigError::MissingKey { section, key })
}

fn optional<'a>(ini: &'a Ini, section: &'static str, key: &'static str) -> Option<&'a str> {
    ini.section(Some(section)).and_then(|s| s.get(key))
}

fn invalid(section: &'static str, key: &'static str, value: &str, reason: &'static str) -> ConfigError {
    ConfigError::InvalidValue {
        section,
        key,
        value: value.to_string(),
        reason,
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
