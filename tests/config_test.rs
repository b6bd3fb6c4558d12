//! Integration tests for loading configuration files.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use ripvault::config::{self, DeviceSourceKind, StoreKind, Target};
use ripvault::ingest::{self, IngestOptions, Ingester};

const FULL: &str = r#"
data_dir = "/var/lib/ripvault"
rip_dir = "/srv/rips"
store = "json"
use_movie_dir = false

[drive]
device = "/dev/sr1"
min_length_secs = 1800
auto_rip = false
source = "none"

[omdb]
api_key = "abc123"

[tools]
makemkvcon = "/opt/makemkv/bin/makemkvcon"
ssh = "/usr/bin/ssh"

[ingest]
command_timeout_secs = 60
transfer_timeout_secs = 7200

[[targets]]
path = "/mnt/archive"

[[targets]]
scheme = "ssh"
host = "nas.local"
path = "/volume1/video"
"#;

#[test]
fn load_full_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ripvault.toml");
    fs::write(&path, FULL).unwrap();

    let config = config::load_config(&path).unwrap();

    assert_eq!(config.data_dir, PathBuf::from("/var/lib/ripvault"));
    assert_eq!(config.rip_dir, PathBuf::from("/srv/rips"));
    assert_eq!(config.store, StoreKind::Json);
    assert!(!config.use_movie_dir);
    assert_eq!(config.drive.device, "/dev/sr1");
    assert_eq!(config.drive.min_length_secs, 1800);
    assert!(!config.drive.auto_rip);
    assert_eq!(config.drive.source, DeviceSourceKind::None);
    assert_eq!(config.omdb.api_key, "abc123");
    assert_eq!(config.omdb.base_url, "https://www.omdbapi.com/");
    assert_eq!(
        config.tools.makemkvcon,
        Some(PathBuf::from("/opt/makemkv/bin/makemkvcon"))
    );
    assert!(config.tools.ffprobe.is_none());
    assert_eq!(
        config.targets,
        vec![
            Target::local("/mnt/archive"),
            Target::ssh("nas.local", "/volume1/video"),
        ]
    );
}

#[test]
fn ingest_options_follow_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ripvault.toml");
    fs::write(&path, FULL).unwrap();
    let config = config::load_config(&path).unwrap();

    let options = IngestOptions::from_config(&config);
    assert!(!options.use_movie_dir);
    assert!(options.ssh.ends_with("ssh"));
    assert_eq!(options.command_timeout, Duration::from_secs(60));
    assert_eq!(options.transfer_timeout, Duration::from_secs(7200));

    let ingesters = ingest::from_config(&config).unwrap();
    let targets: Vec<String> = ingesters.iter().map(|i| i.target().to_string()).collect();
    assert_eq!(targets, vec!["/mnt/archive", "ssh://nas.local/volume1/video"]);
}

#[test]
fn empty_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ripvault.toml");
    fs::write(&path, "").unwrap();

    let config = config::load_config(&path).unwrap();

    assert_eq!(config.store, StoreKind::Sqlite);
    assert_eq!(config.drive.device, "/dev/sr0");
    assert!(config.drive.auto_rip);
    assert!(config.use_movie_dir);
    assert!(config.targets.is_empty());
}

#[test]
fn unknown_scheme_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ripvault.toml");
    fs::write(&path, "[[targets]]\nscheme = \"ftp\"\npath = \"/x\"\n").unwrap();

    let err = config::load_config(&path).unwrap_err();
    assert!(err.to_string().contains("unsupported scheme"));
}

#[test]
fn malformed_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ripvault.toml");
    fs::write(&path, "[drive\ndevice = ").unwrap();

    let err = config::load_config(&path).unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to parse config file"));
}

#[test]
fn explicit_path_wins_over_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom.toml");
    fs::write(&path, "[drive]\ndevice = \"/dev/sr9\"\n").unwrap();

    let config = config::load_config_or_default(Some(&path)).unwrap();
    assert_eq!(config.drive.device, "/dev/sr9");
}
