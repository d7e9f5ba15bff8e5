//! Passive bus monitor.
//!
//! Opens a link in monitor mode and logs every received frame until the link
//! closes or a shutdown is requested.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::device::{Connector, Link, LinkListener, LinkMode};
use crate::error::Result;
use crate::session::config::LinkSpec;
use crate::session::Completion;
use crate::sink::Sink;
use crate::types::{CloseEvent, FrameEvent};

/// How often the wait loop checks whether the link is still open.
pub const MONITOR_POLL_INTERVAL: Duration = Duration::from_millis(500);

struct FrameLogger {
    sink: Arc<dyn Sink>,
    timestamps: bool,
    closed: Arc<Notify>,
}

impl FrameLogger {
    fn log(&self, event: &FrameEvent) {
        let line = if self.timestamps {
            format!("{} {}", event.received_at.format("%H:%M:%S%.3f"), event.frame)
        } else {
            event.frame.to_string()
        };
        self.sink.always(&line);
    }
}

impl LinkListener for FrameLogger {
    fn link_closed(&self, event: &CloseEvent) {
        self.sink
            .info(&format!("network monitor closed ({})", event.reason));
        self.closed.notify_one();
    }

    fn indication(&self, event: &FrameEvent) {
        self.log(event);
    }

    fn confirmation(&self, event: &FrameEvent) {
        self.log(event);
    }
}

/// A running monitor.
pub struct Monitor {
    link: Arc<dyn Link>,
    closed: Arc<Notify>,
}

impl Monitor {
    /// Open the monitor link and start logging frames to `sink`.
    pub async fn start(
        spec: &LinkSpec,
        connector: &dyn Connector,
        sink: Arc<dyn Sink>,
        timestamps: bool,
    ) -> Result<Self> {
        let link = connector.open_link(spec, LinkMode::Monitor).await?;
        info!(link = %link.name(), "Monitor started");

        let closed = Arc::new(Notify::new());
        link.add_listener(Arc::new(FrameLogger {
            sink,
            timestamps,
            closed: closed.clone(),
        }));
        Ok(Self { link, closed })
    }

    pub fn is_running(&self) -> bool {
        self.link.is_open()
    }

    /// Wait while the link is open. Returns true if `shutdown` ended the wait.
    pub async fn wait(&self, shutdown: &CancellationToken) -> bool {
        while self.link.is_open() {
            tokio::select! {
                _ = shutdown.cancelled() => return true,
                _ = self.closed.notified() => {}
                _ = sleep(MONITOR_POLL_INTERVAL) => {}
            }
        }
        false
    }

    /// Close the link if it is still open.
    pub async fn quit(&self) {
        if self.link.is_open() {
            self.link.close().await;
        }
    }
}

/// Run a monitor until the link closes or `shutdown` is cancelled.
pub async fn run(
    spec: &LinkSpec,
    connector: &dyn Connector,
    sink: Arc<dyn Sink>,
    timestamps: bool,
    shutdown: &CancellationToken,
) -> Completion {
    match Monitor::start(spec, connector, sink, timestamps).await {
        Ok(monitor) => {
            let canceled = monitor.wait(shutdown).await;
            monitor.quit().await;
            info!(canceled, "Monitor stopped");
            Completion {
                canceled,
                error: None,
            }
        }
        Err(e) => Completion {
            canceled: false,
            error: Some(e),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::memory::{MemoryConnector, MemoryDevice};
    use crate::session::config::SerialPort;
    use crate::sink::{MemorySink, Severity};
    use crate::types::Medium;

    fn spec() -> LinkSpec {
        LinkSpec::Serial {
            port: SerialPort::Device("/dev/ttyUSB0".to_string()),
            medium: Medium::Tp1,
        }
    }

    fn device() -> MemoryDevice {
        MemoryDevice::new()
            .frame(&[0x29, 0x00, 0xbc], Some("L_Data.ind 1.1.10->1/2/0"))
            .frame(&[0x2b, 0x00], None)
    }

    #[tokio::test]
    async fn test_frames_logged_verbatim() {
        let connector = MemoryConnector::new(device());
        let sink = Arc::new(MemorySink::new());
        let monitor = Monitor::start(&spec(), &connector, sink.clone(), false)
            .await
            .unwrap();

        assert!(monitor.is_running());
        assert_eq!(
            sink.messages(Severity::Always),
            vec!["L_Data.ind 1.1.10->1/2/0", "2b00"]
        );
        monitor.quit().await;
        assert!(!monitor.is_running());
        assert_eq!(
            sink.messages(Severity::Info),
            vec!["network monitor closed (user request)"]
        );
    }

    #[tokio::test]
    async fn test_timestamps() {
        let connector = MemoryConnector::new(device());
        let sink = Arc::new(MemorySink::new());
        let _monitor = Monitor::start(&spec(), &connector, sink.clone(), true)
            .await
            .unwrap();

        let lines = sink.messages(Severity::Always);
        assert!(lines[1].ends_with(" 2b00"));
        assert_eq!(lines[1].len(), "00:00:00.000 2b00".len());
    }

    #[tokio::test(start_paused = true)]
    async fn test_peer_close_ends_wait() {
        let connector = MemoryConnector::new(device());
        let sink = Arc::new(MemorySink::new());
        let shutdown = CancellationToken::new();
        let spec = spec();

        let (completion, _) = tokio::join!(
            run(&spec, &connector, sink.clone(), false, &shutdown),
            async {
                sleep(Duration::from_millis(1200)).await;
                connector.disconnect("port removed");
            }
        );

        assert!(!completion.canceled);
        assert!(completion.error.is_none());
        assert_eq!(connector.links()[0].close_count(), 1);
        assert_eq!(
            sink.messages(Severity::Info),
            vec!["network monitor closed (port removed)"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_monitor() {
        let connector = MemoryConnector::new(device());
        let sink = Arc::new(MemorySink::new());
        let shutdown = CancellationToken::new();
        let spec = spec();

        let (completion, _) = tokio::join!(
            run(&spec, &connector, sink.clone(), false, &shutdown),
            async {
                sleep(Duration::from_millis(700)).await;
                shutdown.cancel();
            }
        );

        assert!(completion.canceled);
        assert!(!connector.links()[0].is_open());
        assert_eq!(connector.links()[0].close_count(), 1);
    }

    #[tokio::test]
    async fn test_open_failure_reported() {
        let connector = MemoryConnector::refusing("device busy");
        let completion = run(
            &spec(),
            &connector,
            Arc::new(MemorySink::new()),
            false,
            &CancellationToken::new(),
        )
        .await;

        assert!(!completion.canceled);
        assert!(completion.error.is_some());
    }
}
