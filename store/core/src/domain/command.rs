// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Command Grammar
//!
//! The closed set of commands a session accepts, one per line:
//!
//! ```text
//! ufile <filename> <destination>
//! dfile <path>
//! rmfile <path>
//! dtar <extension>
//! display <path>
//! ```
//!
//! Arity is exact. Anything else is a [`CommandParseError`], which the
//! dispatcher answers with `Invalid command` without ending the session.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Implements internal responsibilities for command parsing

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown verb: {0}")]
    UnknownVerb(String),

    #[error("{verb} expects {expected} argument(s), got {actual}")]
    Arity {
        verb: Verb,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Upload,
    Download,
    Remove,
    Archive,
    Display,
}

impl Verb {
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Upload => "ufile",
            Verb::Download => "dfile",
            Verb::Remove => "rmfile",
            Verb::Archive => "dtar",
            Verb::Display => "display",
        }
    }

    /// Number of positional arguments the verb takes
    pub fn arity(self) -> usize {
        match self {
            Verb::Upload => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = CommandParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ufile" => Ok(Verb::Upload),
            "dfile" => Ok(Verb::Download),
            "rmfile" => Ok(Verb::Remove),
            "dtar" => Ok(Verb::Archive),
            "display" => Ok(Verb::Display),
            other => Err(CommandParseError::UnknownVerb(other.to_string())),
        }
    }
}

/// One parsed command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Upload { filename: String, destination: String },
    Download { path: String },
    Remove { path: String },
    Archive { extension: String },
    Display { path: String },
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, CommandParseError> {
        let mut tokens = line.split_ascii_whitespace();
        let verb: Verb = tokens.next().ok_or(CommandParseError::Empty)?.parse()?;
        let mut args: Vec<String> = tokens.map(str::to_string).collect();

        if args.len() != verb.arity() {
            return Err(CommandParseError::Arity {
                verb,
                expected: verb.arity(),
                actual: args.len(),
            });
        }

        let command = match verb {
            Verb::Upload => {
                let destination = args.pop().unwrap_or_default();
                let filename = args.pop().unwrap_or_default();
                Command::Upload { filename, destination }
            }
            Verb::Download => Command::Download { path: args.remove(0) },
            Verb::Remove => Command::Remove { path: args.remove(0) },
            Verb::Archive => Command::Archive { extension: args.remove(0) },
            Verb::Display => Command::Display { path: args.remove(0) },
        };
        Ok(command)
    }

    pub fn verb(&self) -> Verb {
        match self {
            Command::Upload { .. } => Verb::Upload,
            Command::Download { .. } => Verb::Download,
            Command::Remove { .. } => Verb::Remove,
            Command::Archive { .. } => Verb::Archive,
            Command::Display { .. } => Verb::Display,
        }
    }
}

/// Renders the wire form of the command (without the trailing newline)
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Upload { filename, destination } => {
                write!(f, "{} {} {}", self.verb(), filename, destination)
            }
            Command::Download { path } | Command::Remove { path } | Command::Display { path } => {
                write!(f, "{} {}", self.verb(), path)
            }
            Command::Archive { extension } => write!(f, "{} {}", self.verb(), extension),
        }
    }
}

impl FromStr for Command {
    type Err = CommandParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_each_verb() {
        assert_eq!(
            Command::parse("ufile a.c ~/smain/x").unwrap(),
            Command::Upload {
                filename: "a.c".to_string(),
                destination: "~/smain/x".to_string()
            }
        );
        assert_eq!(
            Command::parse("dfile ~/smain/a.c").unwrap(),
            Command::Download { path: "~/smain/a.c".to_string() }
        );
        assert_eq!(
            Command::parse("rmfile ~/smain/a.txt").unwrap(),
            Command::Remove { path: "~/smain/a.txt".to_string() }
        );
        assert_eq!(
            Command::parse("dtar .pdf").unwrap(),
            Command::Archive { extension: ".pdf".to_string() }
        );
        assert_eq!(
            Command::parse("display ~/smain").unwrap(),
            Command::Display { path: "~/smain".to_string() }
        );
    }

    #[test]
    fn test_parse_tolerates_extra_whitespace() {
        assert_eq!(
            Command::parse("  dfile\t~/smain/a.c \r").unwrap(),
            Command::Download { path: "~/smain/a.c".to_string() }
        );
    }

    #[test]
    fn test_unknown_verb() {
        assert_eq!(
            Command::parse("foo x y"),
            Err(CommandParseError::UnknownVerb("foo".to_string()))
        );
        assert!(Command::parse("UFILE a.c ~/smain").is_err());
    }

    #[test]
    fn test_wrong_arity() {
        assert!(matches!(
            Command::parse("ufile a.c"),
            Err(CommandParseError::Arity { expected: 2, actual: 1, .. })
        ));
        assert!(matches!(
            Command::parse("dfile a.c extra"),
            Err(CommandParseError::Arity { expected: 1, actual: 2, .. })
        ));
        assert!(matches!(
            Command::parse("display"),
            Err(CommandParseError::Arity { expected: 1, actual: 0, .. })
        ));
    }

    #[test]
    fn test_empty_line() {
        assert_eq!(Command::parse(""), Err(CommandParseError::Empty));
        assert_eq!(Command::parse("   "), Err(CommandParseError::Empty));
    }

    #[test]
    fn test_display_renders_wire_line() {
        let command = Command::Upload {
            filename: "n.txt".to_string(),
            destination: "/home/a/stext/d".to_string(),
        };
        assert_eq!(command.to_string(), "ufile n.txt /home/a/stext/d");
        assert_eq!(Command::parse(&command.to_string()).unwrap(), command);
    }
}
