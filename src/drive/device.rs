//! Device presence events and their sources.

use ripvault_common::{Disc, Error, Result};
use tokio::sync::mpsc;

const EVENT_BUFFER: usize = 16;

/// Presence of a medium in a drive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEvent {
    /// Block device, e.g. `/dev/sr0`.
    pub device: String,
    /// The inserted medium, or `None` when the drive became empty.
    pub media: Option<Disc>,
}

impl DeviceEvent {
    pub fn inserted(
        device: impl Into<String>,
        uuid: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            device: device.into(),
            media: Some(Disc {
                uuid: uuid.into(),
                label: label.into(),
            }),
        }
    }

    pub fn removed(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            media: None,
        }
    }
}

/// Something that reports drive presence changes.
///
/// `start` is called once; the source keeps producing events until it is
/// dropped.
pub trait DeviceEventSource: Send {
    fn start(&mut self) -> Result<mpsc::Receiver<DeviceEvent>>;
}

/// A source driven by hand through a [`FakeDeviceHandle`].
pub struct FakeDeviceSource {
    rx: Option<mpsc::Receiver<DeviceEvent>>,
}

/// Injects events into a [`FakeDeviceSource`].
#[derive(Clone)]
pub struct FakeDeviceHandle {
    device: String,
    tx: mpsc::Sender<DeviceEvent>,
}

impl FakeDeviceSource {
    pub fn new(device: impl Into<String>) -> (Self, FakeDeviceHandle) {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        (
            Self { rx: Some(rx) },
            FakeDeviceHandle {
                device: device.into(),
                tx,
            },
        )
    }
}

impl DeviceEventSource for FakeDeviceSource {
    fn start(&mut self) -> Result<mpsc::Receiver<DeviceEvent>> {
        self.rx
            .take()
            .ok_or_else(|| Error::internal("fake device source already started"))
    }
}

impl FakeDeviceHandle {
    pub async fn insert(&self, uuid: &str, label: &str) {
        self.send(DeviceEvent::inserted(&self.device, uuid, label))
            .await;
    }

    pub async fn eject(&self) {
        self.send(DeviceEvent::removed(&self.device)).await;
    }

    pub async fn send(&self, event: DeviceEvent) {
        // A closed channel means the listener is gone; nothing to notify.
        let _ = self.tx.send(event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_source_delivers_in_order() {
        let (mut source, handle) = FakeDeviceSource::new("/dev/sr0");
        let mut rx = source.start().unwrap();

        handle.insert("uuid-1", "MOVIE").await;
        handle.eject().await;

        assert_eq!(
            rx.recv().await,
            Some(DeviceEvent::inserted("/dev/sr0", "uuid-1", "MOVIE"))
        );
        assert_eq!(rx.recv().await, Some(DeviceEvent::removed("/dev/sr0")));
    }

    #[test]
    fn test_fake_source_starts_once() {
        let (mut source, _handle) = FakeDeviceSource::new("/dev/sr0");
        assert!(source.start().is_ok());
        assert!(source.start().is_err());
    }
}
