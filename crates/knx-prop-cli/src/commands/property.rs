//! One-shot property command.

use knx_prop_core::session::config::ConnectionOptions;
use knx_prop_core::session::interpreter::{Interpreter, State};
use knx_prop_core::storage::Catalog;

use super::{finish, open_session, Context};
use crate::cli::PropertyArgs;
use crate::error::{CliError, Result};

pub const CANCELED_MESSAGE: &str = "reading property canceled";

/// Run the property command
pub async fn run_property(
    args: PropertyArgs,
    options: &ConnectionOptions,
    catalog: Catalog,
    ctx: &Context,
) -> Result<()> {
    if args.command.is_empty() {
        return Err(CliError::InvalidArgument(
            "missing property command, e.g. `get 0 1`".to_string(),
        ));
    }
    let spec = options.validate()?;
    let session = open_session(&spec, catalog, ctx, CANCELED_MESSAGE).await?;

    let state = {
        let mut interpreter = Interpreter::new(&session, ctx.sink.as_ref());
        tokio::select! {
            state = interpreter.execute(args.command.as_slice()) => state,
            _ = session.token().cancelled() => State::Error,
        }
    };
    finish(session, state == State::Error, ctx, CANCELED_MESSAGE).await
}
