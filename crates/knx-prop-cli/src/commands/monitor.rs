//! Passive bus monitor.

use knx_prop_core::monitor;
use knx_prop_core::session::config::ConnectionOptions;

use super::{fail, Context};
use crate::cli::MonitorArgs;
use crate::error::Result;

pub const STOPPED_MESSAGE: &str = "network monitor stopped";

/// Run the monitor until interrupted or the link closes
pub async fn run_monitor(args: MonitorArgs, options: &ConnectionOptions, ctx: &Context) -> Result<()> {
    let spec = options.monitor_link()?;

    let mut completion = monitor::run(
        &spec,
        ctx.connector.as_ref(),
        ctx.sink.clone(),
        args.timestamps,
        &ctx.shutdown,
    )
    .await;

    match completion.error.take() {
        Some(e) => Err(fail(e, ctx.sink.as_ref(), STOPPED_MESSAGE)),
        None => {
            completion.report(ctx.sink.as_ref(), STOPPED_MESSAGE);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knx_prop_core::device::memory::{MemoryConnector, MemoryDevice};
    use knx_prop_core::sink::{MemorySink, Severity};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    #[tokio::test(start_paused = true)]
    async fn test_interrupt_stops_monitor() {
        let device = MemoryDevice::new().frame(&[0x29, 0x00], Some("L_Data.ind"));
        let sink = Arc::new(MemorySink::new());
        let ctx = Context {
            sink: sink.clone(),
            connector: Box::new(MemoryConnector::new(device)),
            shutdown: CancellationToken::new(),
        };
        let options = ConnectionOptions {
            serial: Some("0".to_string()),
            ..Default::default()
        };

        let (result, _) = tokio::join!(
            run_monitor(MonitorArgs { timestamps: false }, &options, &ctx),
            async {
                tokio::time::sleep(Duration::from_millis(300)).await;
                ctx.shutdown.cancel();
            }
        );

        assert!(result.is_ok());
        assert_eq!(sink.messages(Severity::Always), vec!["L_Data.ind"]);
        assert_eq!(
            sink.messages(Severity::Info).last().map(String::as_str),
            Some(STOPPED_MESSAGE)
        );
    }

    #[tokio::test]
    async fn test_missing_endpoint() {
        let ctx = Context {
            sink: Arc::new(MemorySink::new()),
            connector: Box::new(MemoryConnector::new(MemoryDevice::new())),
            shutdown: CancellationToken::new(),
        };
        let result = run_monitor(
            MonitorArgs { timestamps: false },
            &ConnectionOptions::default(),
            &ctx,
        )
        .await;
        assert!(result.is_err());
    }
}
