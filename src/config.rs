//! Run configuration
//!
//! A validated, immutable [`TransferConfig`] is produced once per run from
//! the command-line flags, with optional defaults loaded from
//! `~/.config/xput/config.toml`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Nominal transfer size: 1 GB. `-g` scales this; the UDP server also uses
/// it as the fixed baseline for loss accounting.
pub const NOMINAL_TRANSFER_SIZE: u64 = 1_000_000_000;

pub const DEFAULT_PORT: u16 = 7001;
pub const DEFAULT_CHUNK_SIZE: usize = 8000;

/// The four mutually exclusive run modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Server,
    Client,
    Writer,
    Reader,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Server => write!(f, "server"),
            Mode::Client => write!(f, "client"),
            Mode::Writer => write!(f, "writer"),
            Mode::Reader => write!(f, "reader"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    #[default]
    Tcp,
    Udp,
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transport::Tcp => write!(f, "TCP"),
            Transport::Udp => write!(f, "UDP"),
        }
    }
}

/// Reader loop termination policy.
///
/// The reader either stops at the first short read (end-of-file) or after a
/// fixed number of chunks derived from the target size. Selecting `-g`
/// explicitly in reader mode picks the fixed-size policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    UntilEof,
    FixedSize(u64),
}

/// Raw flag values as collected by the CLI, before validation.
#[derive(Debug, Clone, Default)]
pub struct RawOptions {
    pub server: bool,
    pub client_host: Option<String>,
    pub writer: bool,
    pub reader: bool,
    pub udp: bool,
    pub port: u16,
    pub chunk_size: usize,
    pub gigabytes: Option<f64>,
    pub file: Option<PathBuf>,
    pub verify: bool,
}

/// Validated per-run configuration, immutable after parse.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    pub mode: Mode,
    pub transport: Transport,
    pub port: u16,
    pub chunk_size: usize,
    /// Total bytes to transfer for the client and writer.
    pub target_bytes: u64,
    /// Reader termination policy.
    pub termination: Termination,
    /// Output file (server), or the file to write/read (writer/reader).
    pub file: Option<PathBuf>,
    /// Remote host, client mode only.
    pub host: Option<String>,
    /// Verify chunks against the pattern buffer, reader mode only.
    pub verify: bool,
}

impl RawOptions {
    /// Validate the flags and build the run configuration.
    ///
    /// Rejects anything other than exactly one mode flag, and writer/reader
    /// without a file path.
    pub fn into_config(self) -> anyhow::Result<TransferConfig> {
        let selected = [
            self.server,
            self.client_host.is_some(),
            self.writer,
            self.reader,
        ]
        .iter()
        .filter(|&&m| m)
        .count();
        if selected != 1 {
            anyhow::bail!("choose exactly one of -s, -c HOST, -w, -r");
        }

        let mode = if self.server {
            Mode::Server
        } else if self.client_host.is_some() {
            Mode::Client
        } else if self.writer {
            Mode::Writer
        } else {
            Mode::Reader
        };

        if matches!(mode, Mode::Writer | Mode::Reader) && self.file.is_none() {
            anyhow::bail!("-f PATH is mandatory for writer and reader modes");
        }

        if self.chunk_size == 0 {
            anyhow::bail!("chunk size must be at least 1 byte");
        }

        let target_bytes =
            (self.gigabytes.unwrap_or(1.0) * NOMINAL_TRANSFER_SIZE as f64) as u64;
        if target_bytes == 0 {
            anyhow::bail!("target size must be positive");
        }

        // An explicit -g switches the reader from read-until-EOF to a fixed
        // chunk count.
        let termination = if mode == Mode::Reader && self.gigabytes.is_some() {
            Termination::FixedSize(target_bytes)
        } else {
            Termination::UntilEof
        };

        let transport = if self.udp {
            Transport::Udp
        } else {
            Transport::Tcp
        };

        Ok(TransferConfig {
            mode,
            transport,
            port: self.port,
            chunk_size: self.chunk_size,
            target_bytes,
            termination,
            file: self.file,
            host: self.client_host,
            verify: self.verify,
        })
    }
}

/// Optional defaults loaded from the config file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Defaults {
    /// Default network port
    pub port: Option<u16>,

    /// Default chunk size in bytes
    pub chunk_size: Option<usize>,

    /// Log level (error, warn, info, debug, trace)
    pub log_level: Option<String>,
}

impl Config {
    /// Load configuration from the default path.
    /// Returns default config if file doesn't exist.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();
        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            Ok(toml::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Get the default config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("xput")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> RawOptions {
        RawOptions {
            port: DEFAULT_PORT,
            chunk_size: DEFAULT_CHUNK_SIZE,
            ..Default::default()
        }
    }

    #[test]
    fn test_no_mode_rejected() {
        assert!(raw().into_config().is_err());
    }

    #[test]
    fn test_two_modes_rejected() {
        let mut options = raw();
        options.server = true;
        options.writer = true;
        assert!(options.into_config().is_err());
    }

    #[test]
    fn test_writer_requires_file() {
        let mut options = raw();
        options.writer = true;
        assert!(options.clone().into_config().is_err());

        options.file = Some(PathBuf::from("/tmp/out.bin"));
        assert!(options.into_config().is_ok());
    }

    #[test]
    fn test_reader_requires_file() {
        let mut options = raw();
        options.reader = true;
        assert!(options.into_config().is_err());
    }

    #[test]
    fn test_client_defaults() {
        let mut options = raw();
        options.client_host = Some("example.net".to_string());
        let config = options.into_config().unwrap();
        assert_eq!(config.mode, Mode::Client);
        assert_eq!(config.transport, Transport::Tcp);
        assert_eq!(config.port, 7001);
        assert_eq!(config.chunk_size, 8000);
        assert_eq!(config.target_bytes, NOMINAL_TRANSFER_SIZE);
        assert_eq!(config.host.as_deref(), Some("example.net"));
    }

    #[test]
    fn test_fractional_gigabytes() {
        let mut options = raw();
        options.client_host = Some("localhost".to_string());
        options.gigabytes = Some(0.001);
        let config = options.into_config().unwrap();
        assert_eq!(config.target_bytes, 1_000_000);
    }

    #[test]
    fn test_reader_termination_policy() {
        let mut options = raw();
        options.reader = true;
        options.file = Some(PathBuf::from("/tmp/in.bin"));
        let config = options.clone().into_config().unwrap();
        assert_eq!(config.termination, Termination::UntilEof);

        options.gigabytes = Some(0.5);
        let config = options.into_config().unwrap();
        assert_eq!(config.termination, Termination::FixedSize(500_000_000));
    }

    #[test]
    fn test_parse_config_file() {
        let toml = r#"
[defaults]
port = 9000
chunk_size = 16000
log_level = "debug"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.defaults.port, Some(9000));
        assert_eq!(config.defaults.chunk_size, Some(16000));
        assert_eq!(config.defaults.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_empty_config_file() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.defaults.port.is_none());
    }
}
