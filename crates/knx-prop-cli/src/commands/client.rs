//! Interactive property client.

use tokio::io::BufReader;

use knx_prop_core::session::config::ConnectionOptions;
use knx_prop_core::session::interactive::{self, LoopExit};
use knx_prop_core::storage::Catalog;

use super::{finish, open_session, property::CANCELED_MESSAGE, Context};
use crate::error::Result;

/// Run the interactive client on stdin
pub async fn run_client(options: &ConnectionOptions, catalog: Catalog, ctx: &Context) -> Result<()> {
    let spec = options.validate()?;
    let session = open_session(&spec, catalog, ctx, CANCELED_MESSAGE).await?;

    let exit = interactive::run(&session, ctx.sink.as_ref(), BufReader::new(tokio::io::stdin())).await;
    finish(session, exit == LoopExit::Interrupted, ctx, CANCELED_MESSAGE).await
}
