//! Tool implementations.

pub mod client;
pub mod monitor;
pub mod property;

pub use client::run_client;
pub use monitor::run_monitor;
pub use property::run_property;

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use knx_prop_core::device::Connector;
use knx_prop_core::session::config::AccessSpec;
use knx_prop_core::storage::{self, catalog, Catalog};
use knx_prop_core::{Completion, CoreError, Session, Sink};

use crate::error::{CliError, Result};

/// What every tool runs with.
pub struct Context {
    pub sink: Arc<dyn Sink>,
    pub connector: Box<dyn Connector>,
    pub shutdown: CancellationToken,
}

/// Load the property definitions.
///
/// Without an explicit file the one in the data directory is used if present.
/// A file that fails to load is reported and the tool continues without
/// definitions.
pub fn load_catalog(definitions: Option<&Path>, sink: &dyn Sink) -> Catalog {
    let mut catalog = Catalog::new();
    let path = match definitions {
        Some(path) => path.to_path_buf(),
        None => match storage::default_definitions_path() {
            Some(path) => path,
            None => return catalog,
        },
    };
    match catalog::load(&path) {
        Ok(definitions) => {
            catalog.merge(definitions);
            debug!(path = %path.display(), count = catalog.len(), "Loaded property definitions");
        }
        Err(e) => sink.error(&e.to_string()),
    }
    catalog
}

/// Open a session, reporting a failure as the tool's completion.
async fn open_session(
    spec: &AccessSpec,
    catalog: Catalog,
    ctx: &Context,
    canceled_message: &str,
) -> Result<Session> {
    Session::open(
        spec,
        catalog,
        ctx.connector.as_ref(),
        ctx.sink.clone(),
        &ctx.shutdown,
    )
    .await
    .map_err(|e| fail(e, ctx.sink.as_ref(), canceled_message))
}

fn fail(error: CoreError, sink: &dyn Sink, canceled_message: &str) -> CliError {
    let completion = Completion {
        canceled: false,
        error: Some(error),
    };
    completion.report(sink, canceled_message);
    match completion.error {
        Some(e) => CliError::Reported(e),
        None => CliError::Reported(CoreError::SessionClosed),
    }
}

/// Close the session and report how the tool ended.
///
/// An end caused by the peer rather than by an interrupt is reported as an
/// error.
async fn finish(session: Session, lost: bool, ctx: &Context, canceled_message: &str) -> Result<()> {
    session.close().await;
    let peer_closed = lost && !ctx.shutdown.is_cancelled();
    let mut completion = Completion {
        canceled: lost,
        error: peer_closed.then_some(CoreError::SessionClosed),
    };
    completion.report(ctx.sink.as_ref(), canceled_message);

    match completion.error.take() {
        Some(e) => Err(CliError::Reported(e)),
        None => Ok(()),
    }
}
