//! Interactive command loop.
//!
//! Reads command lines until `exit`, end of input, or until the session is
//! closed from outside. Input is awaited in bounded slices so a close is
//! noticed within one poll interval even while no line arrives. A running
//! command is abandoned as soon as the session token is cancelled.

use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::time::timeout;
use tracing::debug;

use crate::protocol::commands::{tokenize, COMMAND_SUMMARY, EXIT_HINT};
use crate::sink::Sink;

use super::interpreter::{Interpreter, State};
use super::Session;

/// Longest time a read waits before the loop checks the session again.
pub const INPUT_POLL_INTERVAL: Duration = Duration::from_millis(200);

pub const PROMPT: &str = "> ";

pub const QUIT_MESSAGE: &str = "received quit (interrupt), closing ...";

/// Why the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The user typed `exit`
    Exit,
    EndOfInput,
    /// Shutdown requested or connection closed by the peer
    Interrupted,
    /// Reading input failed
    Failed,
}

/// Run the loop on `input` until it ends. The session stays open.
pub async fn run<R>(session: &Session, sink: &dyn Sink, input: R) -> LoopExit
where
    R: AsyncBufRead + Unpin,
{
    sink.always(EXIT_HINT);
    sink.always("");
    sink.info(COMMAND_SUMMARY);

    let token = session.token().clone();
    let mut interpreter = Interpreter::interactive(session, sink);
    let mut lines = input.lines();

    loop {
        sink.prompt(PROMPT);
        let line = loop {
            tokio::select! {
                _ = token.cancelled() => {
                    sink.always(QUIT_MESSAGE);
                    return LoopExit::Interrupted;
                }
                read = timeout(INPUT_POLL_INTERVAL, lines.next_line()) => match read {
                    Err(_) => continue,
                    Ok(Ok(Some(line))) => break line,
                    Ok(Ok(None)) => {
                        interpreter.finish();
                        debug!("End of input");
                        return LoopExit::EndOfInput;
                    }
                    Ok(Err(e)) => {
                        sink.error(&format!("I/O error, {}", e));
                        return LoopExit::Failed;
                    }
                }
            }
        };

        let args = tokenize(&line);
        if args.is_empty() {
            continue;
        }
        let state = tokio::select! {
            state = interpreter.execute(&args) => state,
            _ = token.cancelled() => State::Error,
        };
        match state {
            State::Done => return LoopExit::Exit,
            State::Error => {
                sink.always(QUIT_MESSAGE);
                return LoopExit::Interrupted;
            }
            _ => {}
        }
    }
}
