//! Job script line parser
//!
//! Turns one line of a job file into a [`Command`].
//!
//! ## Grammar
//!
//! ```text
//! WRITE [(key,value)(key2,value2)...]
//! READ [key,key2,...]
//! DELETE [key,key2,...]
//! SHOW
//! WAIT <delay_ms>
//! BACKUP
//! HELP
//! ```
//!
//! Whitespace around tokens is tolerated. Keys and values are non-empty,
//! contain no whitespace and none of `()[],`.

use crate::error::{KvsError, Result};
use super::Command;

/// Characters that delimit tokens and so cannot appear inside one
const RESERVED: &[char] = &['(', ')', '[', ']', ','];

/// Size limits enforced while parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseLimits {
    /// Max pairs (WRITE) or keys (READ/DELETE) per command
    pub max_pairs: usize,

    /// Max length of a single key or value, in bytes
    pub max_string_size: usize,
}

impl Default for ParseLimits {
    fn default() -> Self {
        Self {
            max_pairs: 256,
            max_string_size: 40,
        }
    }
}

/// Parse one line into a command
///
/// A whitespace-only line is `Command::Empty`. Comment handling and the
/// end-of-commands marker belong to the job reader, not to this function.
pub fn parse_line(line: &str, limits: &ParseLimits) -> Result<Command> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Command::Empty);
    }

    let (keyword, rest) = match line.find(|c: char| c.is_whitespace() || c == '[') {
        Some(idx) => (&line[..idx], line[idx..].trim()),
        None => (line, ""),
    };

    match keyword {
        "WRITE" => Ok(Command::Write {
            pairs: parse_pairs(rest, limits)?,
        }),
        "READ" => Ok(Command::Read {
            keys: parse_keys("READ", rest, limits)?,
        }),
        "DELETE" => Ok(Command::Delete {
            keys: parse_keys("DELETE", rest, limits)?,
        }),
        "SHOW" => no_arguments("SHOW", rest).map(|_| Command::Show),
        "BACKUP" => no_arguments("BACKUP", rest).map(|_| Command::Backup),
        "HELP" => no_arguments("HELP", rest).map(|_| Command::Help),
        "WAIT" => parse_wait(rest),
        other => Err(KvsError::parse(format!("unknown command '{}'", other))),
    }
}

/// Parse the `[(k,v)(k2,v2)]` argument of WRITE
fn parse_pairs(rest: &str, limits: &ParseLimits) -> Result<Vec<(String, String)>> {
    let mut inner = bracketed("WRITE", rest)?;
    let mut pairs = Vec::new();

    loop {
        inner = inner.trim_start();
        if inner.is_empty() {
            break;
        }

        let body = inner.strip_prefix('(').ok_or_else(|| {
            KvsError::parse(format!("WRITE: expected '(' at '{}'", inner))
        })?;
        let close = body
            .find(')')
            .ok_or_else(|| KvsError::parse("WRITE: unterminated pair"))?;

        let (key, value) = body[..close]
            .split_once(',')
            .ok_or_else(|| KvsError::parse("WRITE: pair must be (key,value)"))?;
        let key = token("WRITE", key, limits)?;
        let value = token("WRITE", value, limits)?;

        pairs.push((key, value));
        if pairs.len() > limits.max_pairs {
            return Err(KvsError::parse(format!(
                "WRITE: more than {} pairs",
                limits.max_pairs
            )));
        }

        inner = &body[close + 1..];
    }

    if pairs.is_empty() {
        return Err(KvsError::parse("WRITE: no pairs given"));
    }

    Ok(pairs)
}

/// Parse the `[k,k2,...]` argument of READ and DELETE
fn parse_keys(name: &str, rest: &str, limits: &ParseLimits) -> Result<Vec<String>> {
    let inner = bracketed(name, rest)?;
    if inner.trim().is_empty() {
        return Err(KvsError::parse(format!("{}: no keys given", name)));
    }

    let keys = inner
        .split(',')
        .map(|key| token(name, key, limits))
        .collect::<Result<Vec<_>>>()?;

    if keys.len() > limits.max_pairs {
        return Err(KvsError::parse(format!(
            "{}: more than {} keys",
            name, limits.max_pairs
        )));
    }

    Ok(keys)
}

fn parse_wait(rest: &str) -> Result<Command> {
    if rest.is_empty() {
        return Err(KvsError::parse("WAIT: missing delay"));
    }

    let delay_ms = rest
        .parse::<u64>()
        .map_err(|_| KvsError::parse(format!("WAIT: invalid delay '{}'", rest)))?;

    Ok(Command::Wait { delay_ms })
}

/// Strip the surrounding `[` `]`
fn bracketed<'a>(name: &str, rest: &'a str) -> Result<&'a str> {
    rest.strip_prefix('[')
        .and_then(|r| r.strip_suffix(']'))
        .ok_or_else(|| KvsError::parse(format!("{}: argument must be enclosed in [ ]", name)))
}

/// Validate and copy a single key or value
fn token(name: &str, raw: &str, limits: &ParseLimits) -> Result<String> {
    let token = raw.trim();

    if token.is_empty() {
        return Err(KvsError::parse(format!("{}: empty key or value", name)));
    }
    if token.contains(RESERVED) || token.contains(char::is_whitespace) {
        return Err(KvsError::parse(format!(
            "{}: invalid character in '{}'",
            name, token
        )));
    }
    if token.len() > limits.max_string_size {
        return Err(KvsError::parse(format!(
            "{}: '{}' exceeds {} bytes",
            name, token, limits.max_string_size
        )));
    }

    Ok(token.to_string())
}

fn no_arguments(name: &str, rest: &str) -> Result<()> {
    if rest.is_empty() {
        Ok(())
    } else {
        Err(KvsError::parse(format!("{} takes no arguments", name)))
    }
}
