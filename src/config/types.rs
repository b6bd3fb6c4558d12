use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Directory holding the database and JSON stores.
    #[serde(default = "default_dir")]
    pub data_dir: PathBuf,

    /// Root of the per-workflow scratch directories.
    #[serde(default = "default_dir")]
    pub rip_dir: PathBuf,

    #[serde(default)]
    pub store: StoreKind,

    /// Place each movie in its own `"{name} ({year})"` directory.
    #[serde(default = "default_true")]
    pub use_movie_dir: bool,

    #[serde(default)]
    pub drive: DriveConfig,

    #[serde(default)]
    pub omdb: OmdbConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub targets: Vec<Target>,
}

fn default_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_dir(),
            rip_dir: default_dir(),
            store: StoreKind::default(),
            use_movie_dir: true,
            drive: DriveConfig::default(),
            omdb: OmdbConfig::default(),
            tools: ToolsConfig::default(),
            ingest: IngestConfig::default(),
            targets: Vec::new(),
        }
    }
}

/// Persistence backend for workflows and the disc info cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Sqlite,
    Json,
}

/// Where device presence events come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceSourceKind {
    #[default]
    Udev,
    None,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DriveConfig {
    #[serde(default = "default_device")]
    pub device: String,

    /// Titles shorter than this are ignored by the ripping engine.
    #[serde(default = "default_min_length")]
    pub min_length_secs: u32,

    /// Start ripping the main title of a newly seen disc.
    #[serde(default = "default_true")]
    pub auto_rip: bool,

    #[serde(default)]
    pub source: DeviceSourceKind,
}

fn default_device() -> String {
    "/dev/sr0".to_string()
}

fn default_min_length() -> u32 {
    ripvault_mkv::DEFAULT_MIN_LENGTH_SECS
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            min_length_secs: default_min_length(),
            auto_rip: true,
            source: DeviceSourceKind::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OmdbConfig {
    /// Metadata lookup is disabled when empty.
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_omdb_url")]
    pub base_url: String,
}

fn default_omdb_url() -> String {
    "https://www.omdbapi.com/".to_string()
}

impl Default for OmdbConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_omdb_url(),
        }
    }
}

/// Explicit paths to external tools; `PATH` is searched otherwise.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolsConfig {
    pub makemkvcon: Option<PathBuf>,
    pub ffprobe: Option<PathBuf>,
    pub ssh: Option<PathBuf>,
    pub scp: Option<PathBuf>,
    pub udevadm: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngestConfig {
    /// Timeout for each remote shell command.
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,

    /// Timeout for copying an artifact to a remote destination.
    #[serde(default = "default_transfer_timeout")]
    pub transfer_timeout_secs: u64,
}

fn default_command_timeout() -> u64 {
    300
}

fn default_transfer_timeout() -> u64 {
    12 * 60 * 60
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            command_timeout_secs: default_command_timeout(),
            transfer_timeout_secs: default_transfer_timeout(),
        }
    }
}

/// One archive destination.
///
/// An empty scheme or `file` is a local directory; `ssh` is a directory on
/// `host` reached over ssh/scp.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Target {
    #[serde(default)]
    pub scheme: String,

    #[serde(default)]
    pub host: Option<String>,

    pub path: PathBuf,
}

impl Target {
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self {
            scheme: String::new(),
            host: None,
            path: path.into(),
        }
    }

    pub fn ssh(host: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            scheme: "ssh".to_string(),
            host: Some(host.into()),
            path: path.into(),
        }
    }

    pub fn is_local(&self) -> bool {
        self.scheme.is_empty() || self.scheme == "file"
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_local() {
            write!(f, "{}", self.path.display())
        } else {
            write!(
                f,
                "{}://{}{}",
                self.scheme,
                self.host.as_deref().unwrap_or(""),
                self.path.display()
            )
        }
    }
}

impl FromStr for Target {
    type Err = String;

    /// Parses `ssh://host/path`, `file:///path`, or a bare path.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((scheme, rest)) = s.split_once("://") else {
            if s.is_empty() {
                return Err("empty target".to_string());
            }
            return Ok(Self::local(s));
        };

        let (host, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, ""),
        };
        if path.is_empty() {
            return Err(format!("target {} has no path", s));
        }

        Ok(Self {
            scheme: scheme.to_string(),
            host: (!host.is_empty()).then(|| host.to_string()),
            path: PathBuf::from(path),
        })
    }
}
