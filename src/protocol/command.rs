//! Command definitions
//!
//! Represents one parsed line of a job script.

use std::fmt;

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandType {
    Write,
    Read,
    Delete,
    Show,
    Wait,
    Backup,
    Help,
    Empty,
    Invalid,
    EndOfCommands,
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommandType::Write => "WRITE",
            CommandType::Read => "READ",
            CommandType::Delete => "DELETE",
            CommandType::Show => "SHOW",
            CommandType::Wait => "WAIT",
            CommandType::Backup => "BACKUP",
            CommandType::Help => "HELP",
            CommandType::Empty => "EMPTY",
            CommandType::Invalid => "INVALID",
            CommandType::EndOfCommands => "EOC",
        };
        f.write_str(name)
    }
}

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Upsert key/value pairs, applied in order
    Write { pairs: Vec<(String, String)> },

    /// Look up keys
    Read { keys: Vec<String> },

    /// Remove keys
    Delete { keys: Vec<String> },

    /// Dump every entry to the job output
    Show,

    /// Sleep the issuing worker
    Wait { delay_ms: u64 },

    /// Snapshot the store to a versioned backup file
    Backup,

    /// Print usage
    Help,

    /// Whitespace-only line
    Empty,

    /// Malformed line; the reason is reported and the line skipped
    Invalid { reason: String },

    /// No more commands in this job
    EndOfCommands,
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Write { .. } => CommandType::Write,
            Command::Read { .. } => CommandType::Read,
            Command::Delete { .. } => CommandType::Delete,
            Command::Show => CommandType::Show,
            Command::Wait { .. } => CommandType::Wait,
            Command::Backup => CommandType::Backup,
            Command::Help => CommandType::Help,
            Command::Empty => CommandType::Empty,
            Command::Invalid { .. } => CommandType::Invalid,
            Command::EndOfCommands => CommandType::EndOfCommands,
        }
    }
}
