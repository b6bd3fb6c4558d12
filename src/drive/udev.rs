//! Device events from udev, read through `udevadm`.
//!
//! `udevadm monitor --property` prints one `KEY=VALUE` block per event,
//! separated by blank lines. The same keys are available for the current
//! state through `udevadm info --query=property`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use ripvault_common::{Error, Result};
use ripvault_mkv::ToolCommand;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::device::{DeviceEvent, DeviceEventSource};

const EVENT_BUFFER: usize = 16;
const INFO_TIMEOUT: Duration = Duration::from_secs(10);

pub type Properties = HashMap<String, String>;

/// Parse `KEY=VALUE` lines, ignoring anything else.
pub fn parse_properties(text: &str) -> Properties {
    text.lines()
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .collect()
}

/// Interpret one property block for `device`.
///
/// Media without a filesystem UUID (audio CDs, blank media) produce no event.
pub fn event_from_properties(props: &Properties, device: &str) -> Option<DeviceEvent> {
    let devname = props.get("DEVNAME")?;
    if devname != device {
        return None;
    }

    let get = |key: &str| props.get(key).map(String::as_str);

    if get("SYSTEMD_READY") == Some("0") || get("ACTION") == Some("remove") {
        return Some(DeviceEvent::removed(devname.as_str()));
    }

    if get("ID_CDROM_MEDIA") == Some("1") {
        return match get("ID_FS_UUID").filter(|u| !u.is_empty()) {
            Some(uuid) => Some(DeviceEvent::inserted(
                devname.as_str(),
                uuid,
                get("ID_FS_LABEL").unwrap_or(""),
            )),
            None => {
                debug!("Medium in {} has no filesystem UUID; ignoring", devname);
                None
            }
        };
    }

    match get("ACTION") {
        None | Some("change") => Some(DeviceEvent::removed(devname.as_str())),
        _ => None,
    }
}

/// Real device source backed by `udevadm`.
pub struct UdevEventSource {
    udevadm: PathBuf,
    device: String,
    task: Option<JoinHandle<()>>,
}

impl UdevEventSource {
    pub fn new(udevadm: impl Into<PathBuf>, device: impl Into<String>) -> Self {
        Self {
            udevadm: udevadm.into(),
            device: device.into(),
            task: None,
        }
    }
}

impl DeviceEventSource for UdevEventSource {
    fn start(&mut self) -> Result<mpsc::Receiver<DeviceEvent>> {
        if self.task.is_some() {
            return Err(Error::internal("udev source already started"));
        }
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let udevadm = self.udevadm.clone();
        let device = self.device.clone();
        self.task = Some(tokio::spawn(async move {
            if let Err(e) = monitor(udevadm, device, tx).await {
                error!("udev monitor stopped: {}", e);
            }
        }));
        Ok(rx)
    }
}

impl Drop for UdevEventSource {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn initial_state(udevadm: &Path, device: &str) -> Result<Option<DeviceEvent>> {
    let output = ToolCommand::new(udevadm)
        .args(["info", "--query=property"])
        .arg(format!("--name={}", device))
        .timeout(INFO_TIMEOUT)
        .execute()
        .await?;
    Ok(event_from_properties(&parse_properties(&output.stdout), device))
}

async fn monitor(udevadm: PathBuf, device: String, tx: mpsc::Sender<DeviceEvent>) -> Result<()> {
    // Start monitoring before the initial query so no change is missed
    // between the two.
    let mut child = Command::new(&udevadm)
        .args(["monitor", "--udev", "--property", "--subsystem-match=block"])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| Error::tool("udevadm", format!("failed to spawn monitor: {e}")))?;

    match initial_state(&udevadm, &device).await {
        Ok(Some(event)) => {
            if tx.send(event).await.is_err() {
                return Ok(());
            }
        }
        Ok(None) => {}
        Err(e) => warn!("Could not read initial state of {}: {}", device, e),
    }

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| Error::internal("udevadm stdout not captured"))?;
    info!("Watching {} for media changes", device);

    let mut lines = BufReader::new(stdout).lines();
    let mut block = String::new();
    while let Some(line) = lines.next_line().await? {
        if !line.trim().is_empty() {
            block.push_str(&line);
            block.push('\n');
            continue;
        }
        if block.is_empty() {
            continue;
        }
        let props = parse_properties(&block);
        block.clear();
        if let Some(event) = event_from_properties(&props, &device) {
            debug!("Device event: {:?}", event);
            if tx.send(event).await.is_err() {
                return Ok(());
            }
        }
    }

    Err(Error::tool("udevadm", "monitor exited"))
}
