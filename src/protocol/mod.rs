//! Protocol Module
//!
//! The job script language: parsing input lines and rendering output lines.
//!
//! ## Input (one command per line)
//! ```text
//! WRITE [(key,value)(key2,value2)...]
//! READ [key,key2,...]
//! DELETE [key,key2,...]
//! SHOW
//! WAIT <delay_ms>
//! BACKUP
//! HELP
//! ```
//! Blank lines and lines starting with `#` are skipped by the job reader.
//!
//! ## Output
//! - READ:   `[(key,value)(key2,KVSERROR)]`
//! - DELETE: `[(key,KVSMISSING)]`, only when some key was missing
//! - SHOW:   one `(key, value)` line per entry, unordered

mod command;
mod parser;
mod response;

pub use command::{Command, CommandType};
pub use parser::{parse_line, ParseLimits};
pub use response::{write_entries, DeleteResponse, ReadResponse};

/// Marker that starts a comment line in a job file
pub const COMMENT_MARKER: char = '#';

/// Usage text printed by HELP
pub const HELP_TEXT: &str = "\
Available commands:
  WRITE [(key,value)(key2,value2),...]
  READ [key,key2,...]
  DELETE [key,key2,...]
  SHOW
  WAIT <delay_ms>
  BACKUP
  HELP
";
