//! Property tool commands and their argument grammar.
//!
//! Commands arrive as token lists, either from the command line or from one
//! line of interactive input. Arity is checked exactly; numeric arguments use
//! `Integer.decode` syntax.

use crate::error::ParseError;
use crate::protocol::codec::{decode_u16, parse_byte_literal};

/// Summary printed for `?`
pub const COMMAND_SUMMARY: &str = "commands: get | set | desc | scan (append ? for help)\n\
get  - read property value(s)\n\
set  - write property value(s)\n\
desc - read one property description\n\
scan - read property descriptions";

/// Extra line shown by the interactive client
pub const EXIT_HINT: &str = "exit - close connection and exit";

pub const WRONG_ARGUMENTS: &str = "sorry, wrong number of arguments";

/// Command keywords that accept `?` for usage help.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Get,
    Set,
    Desc,
    Scan,
}

impl CommandKind {
    pub fn usage(self) -> &'static str {
        match self {
            CommandKind::Get => "get object-idx pid [start-idx elements]",
            CommandKind::Set => {
                "set object-idx pid [start-idx] string-value\n\
                 set object-idx pid start-idx elements [\"0x\"|\"0\"|\"b\"]data\n\
                 (use hexadecimal format for more than 8 byte data or leading zeros)"
            }
            CommandKind::Desc => "desc object-idx pid\ndesc object-idx \"i\" prop-idx",
            CommandKind::Scan => "scan [object-idx] [\"all\" for all object properties]",
        }
    }
}

/// A parsed property command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Read one translated value, or `count` elements from `start`
    Get {
        object_index: u16,
        pid: u16,
        range: Option<(u16, u16)>,
    },
    /// Write one element from its string form
    SetValue {
        object_index: u16,
        pid: u16,
        start: u16,
        value: String,
    },
    /// Write raw data of `count` elements
    SetData {
        object_index: u16,
        pid: u16,
        start: u16,
        count: u16,
        data: Vec<u8>,
    },
    DescribeById {
        object_index: u16,
        pid: u16,
    },
    DescribeByIndex {
        object_index: u16,
        property_index: u16,
    },
    Scan {
        object_index: Option<u16>,
        all: bool,
    },
    /// Command summary, or usage of one command
    Help(Option<CommandKind>),
    Exit,
}

/// Why a token list did not form a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    Empty,
    Unknown(String),
    Usage(CommandKind),
    Parse(ParseError),
}

impl From<ParseError> for CommandError {
    fn from(e: ParseError) -> Self {
        CommandError::Parse(e)
    }
}

/// Split one line of user input into tokens.
pub fn tokenize(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_string).collect()
}

/// Parse a command with its arguments.
pub fn parse_command<S: AsRef<str>>(args: &[S]) -> Result<Command, CommandError> {
    let args: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
    let Some(&what) = args.first() else {
        return Err(CommandError::Empty);
    };

    match what {
        "get" => parse_get(&args),
        "set" => parse_set(&args),
        "desc" => parse_desc(&args),
        "scan" => parse_scan(&args),
        "?" => Ok(Command::Help(None)),
        w if w.eq_ignore_ascii_case("exit") => Ok(Command::Exit),
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

fn wants_help(args: &[&str]) -> bool {
    args.len() == 2 && args[1] == "?"
}

fn parse_get(args: &[&str]) -> Result<Command, CommandError> {
    if wants_help(args) {
        return Ok(Command::Help(Some(CommandKind::Get)));
    }
    match args.len() {
        3 => Ok(Command::Get {
            object_index: decode_u16(args[1])?,
            pid: decode_u16(args[2])?,
            range: None,
        }),
        5 => Ok(Command::Get {
            object_index: decode_u16(args[1])?,
            pid: decode_u16(args[2])?,
            range: Some((decode_u16(args[3])?, decode_u16(args[4])?)),
        }),
        _ => Err(CommandError::Usage(CommandKind::Get)),
    }
}

fn parse_set(args: &[&str]) -> Result<Command, CommandError> {
    if wants_help(args) {
        return Ok(Command::Help(Some(CommandKind::Set)));
    }
    if !(4..=6).contains(&args.len()) {
        return Err(CommandError::Usage(CommandKind::Set));
    }

    let object_index = decode_u16(args[1])?;
    let pid = decode_u16(args[2])?;
    let command = match args.len() {
        4 => Command::SetValue {
            object_index,
            pid,
            start: 1,
            value: args[3].to_string(),
        },
        5 => Command::SetValue {
            object_index,
            pid,
            start: decode_u16(args[3])?,
            value: args[4].to_string(),
        },
        _ => Command::SetData {
            object_index,
            pid,
            start: decode_u16(args[3])?,
            count: decode_u16(args[4])?,
            data: parse_byte_literal(args[5])?,
        },
    };
    Ok(command)
}

fn parse_desc(args: &[&str]) -> Result<Command, CommandError> {
    if wants_help(args) {
        return Ok(Command::Help(Some(CommandKind::Desc)));
    }
    match args.len() {
        3 => Ok(Command::DescribeById {
            object_index: decode_u16(args[1])?,
            pid: decode_u16(args[2])?,
        }),
        4 if args[2] == "i" => Ok(Command::DescribeByIndex {
            object_index: decode_u16(args[1])?,
            property_index: decode_u16(args[3])?,
        }),
        _ => Err(CommandError::Usage(CommandKind::Desc)),
    }
}

fn parse_scan(args: &[&str]) -> Result<Command, CommandError> {
    if wants_help(args) {
        return Ok(Command::Help(Some(CommandKind::Scan)));
    }
    match args.len() {
        1 => Ok(Command::Scan {
            object_index: None,
            all: false,
        }),
        2 if args[1] == "all" => Ok(Command::Scan {
            object_index: None,
            all: true,
        }),
        2 => Ok(Command::Scan {
            object_index: Some(decode_u16(args[1])?),
            all: false,
        }),
        3 if args[2] == "all" => Ok(Command::Scan {
            object_index: Some(decode_u16(args[1])?),
            all: true,
        }),
        _ => Err(CommandError::Usage(CommandKind::Scan)),
    }
}
