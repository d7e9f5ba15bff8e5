//! Command interpreter.
//!
//! Parses one command at a time, runs it against the session and reports
//! results and recoverable errors to the sink. Only the loss of the session
//! ends the interpreter in [`State::Error`].

use crate::error::CoreError;
use crate::protocol::codec::{format_hex_groups, format_hex_value};
use crate::protocol::commands::{
    parse_command, Command, CommandError, COMMAND_SUMMARY, WRONG_ARGUMENTS,
};
use crate::sink::Sink;
use crate::types::Description;

use super::Session;

/// Message for anything that is not a command keyword.
pub const UNKNOWN_COMMAND: &str = "unknown command, type ? for help";

/// Interpreter state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Waiting for the next command
    Idle,
    /// Parsing and selecting a command
    Dispatch,
    /// Running a property service
    Executing,
    /// The session was lost
    Error,
    /// `exit` or end of input
    Done,
}

pub struct Interpreter<'a> {
    session: &'a Session,
    sink: &'a dyn Sink,
    state: State,
    accepts_exit: bool,
}

impl<'a> Interpreter<'a> {
    /// Interpreter for one-shot commands.
    pub fn new(session: &'a Session, sink: &'a dyn Sink) -> Self {
        Self {
            session,
            sink,
            state: State::Idle,
            accepts_exit: false,
        }
    }

    /// Interpreter that also accepts `exit`.
    pub fn interactive(session: &'a Session, sink: &'a dyn Sink) -> Self {
        Self {
            accepts_exit: true,
            ..Self::new(session, sink)
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Mark the interpreter finished, e.g. on end of input.
    pub fn finish(&mut self) {
        if self.state != State::Error {
            self.state = State::Done;
        }
    }

    /// Run one command with its arguments and return the new state.
    pub async fn execute<S: AsRef<str>>(&mut self, args: &[S]) -> State {
        if matches!(self.state, State::Error | State::Done) {
            return self.state;
        }
        self.state = State::Dispatch;

        let command = match parse_command(args) {
            Ok(Command::Exit) if self.accepts_exit => {
                self.state = State::Done;
                return self.state;
            }
            Ok(Command::Exit) => {
                self.sink.info(UNKNOWN_COMMAND);
                self.state = State::Idle;
                return self.state;
            }
            Ok(command) => command,
            Err(e) => {
                self.report(e);
                self.state = State::Idle;
                return self.state;
            }
        };

        self.state = State::Executing;
        self.state = match self.run(command).await {
            Ok(()) => State::Idle,
            Err(CoreError::SessionClosed) => State::Error,
            Err(e) => {
                self.sink.error(&e.to_string());
                State::Idle
            }
        };
        self.state
    }

    fn report(&self, error: CommandError) {
        match error {
            CommandError::Empty => {}
            CommandError::Unknown(_) => self.sink.info(UNKNOWN_COMMAND),
            CommandError::Usage(kind) => {
                self.sink.error(WRONG_ARGUMENTS);
                self.sink.error(kind.usage());
            }
            CommandError::Parse(e) => self.sink.error(&e.to_string()),
        }
    }

    async fn run(&self, command: Command) -> Result<(), CoreError> {
        match command {
            Command::Get {
                object_index,
                pid,
                range: None,
            } => {
                let value = match self.session.read_translated(object_index, pid, 1, 1).await {
                    Ok(values) => values.into_iter().next().unwrap_or_default(),
                    Err(CoreError::Protocol(_)) => {
                        format_hex_value(&self.session.read_raw(object_index, pid, 1, 1).await?)
                    }
                    Err(e) => return Err(e),
                };
                self.sink.always(&value);
            }
            Command::Get {
                object_index,
                pid,
                range: Some((start, count)),
            } => {
                let value = match self
                    .session
                    .read_translated(object_index, pid, start, count)
                    .await
                {
                    Ok(values) => format!("[{}]", values.join(", ")),
                    Err(CoreError::Protocol(_)) => {
                        let data = self
                            .session
                            .read_raw(object_index, pid, start, count)
                            .await?;
                        format_hex_groups(&data, usize::from(count))
                    }
                    Err(e) => return Err(e),
                };
                self.sink.always(&value);
            }
            Command::SetValue {
                object_index,
                pid,
                start,
                value,
            } => {
                self.session
                    .write_value(object_index, pid, start, &value)
                    .await?
            }
            Command::SetData {
                object_index,
                pid,
                start,
                count,
                data,
            } => {
                self.session
                    .write_data(object_index, pid, start, count, &data)
                    .await?
            }
            Command::DescribeById { object_index, pid } => {
                let desc = self.session.describe(object_index, pid).await?;
                self.sink.always(&self.format_description(&desc));
            }
            Command::DescribeByIndex {
                object_index,
                property_index,
            } => {
                let desc = self
                    .session
                    .describe_by_index(object_index, property_index)
                    .await?;
                self.sink.always(&self.format_description(&desc));
            }
            Command::Scan { object_index, all } => {
                for desc in self.session.scan(object_index, all).await? {
                    self.sink.always(&self.format_description(&desc));
                }
            }
            Command::Help(None) => self.sink.info(COMMAND_SUMMARY),
            Command::Help(Some(kind)) => self.sink.info(kind.usage()),
            Command::Exit => {}
        }
        Ok(())
    }

    /// One line per description, naming the property from the catalog.
    pub fn format_description(&self, desc: &Description) -> String {
        let def = self.session.catalog().lookup(desc.object_type, desc.pid);

        let mut line = format!(
            "{} OT {}, OI {}, PID {}",
            desc.property_index, desc.object_type, desc.object_index, desc.pid
        );
        if let Some(def) = def {
            line.push_str(&format!(" ({})", def.name));
        }
        let pdt = match (desc.pdt, def) {
            (Some(pdt), _) => pdt.to_string(),
            (None, Some(def)) => def
                .pdt
                .map(|pdt| pdt.to_string())
                .unwrap_or_else(|| "-1".to_string()),
            (None, None) => "-".to_string(),
        };
        line.push_str(&format!(
            ", PDT {}, curr. elems {}, max. {}, r/w access {}/{}, {}",
            pdt,
            desc.current_elements,
            desc.max_elements,
            desc.read_level,
            desc.write_level,
            if desc.write_enabled {
                "w.enabled"
            } else {
                "r.only"
            }
        ));
        line
    }
}
