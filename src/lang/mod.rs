// src/lang/mod.rs

//! The painter command language.
//!
//! Scripts are line oriented: one command per line, arguments separated by
//! whitespace, blank lines ignored. Parsing is all-or-nothing; a script with a
//! single bad line yields no operations at all.

pub mod commands;
pub mod parser;

pub use commands::Command;
pub use parser::{Batch, BatchReader, Parser};

use std::fmt;
use std::io;

/// Why a script was rejected. Line numbers are 1-based.
#[derive(Debug)]
pub enum ParseError {
    UnknownCommand {
        line: usize,
        command: String,
    },
    ArgCount {
        line: usize,
        command: &'static str,
        expected: usize,
        actual: usize,
    },
    /// An argument that is not a finite decimal number.
    InvalidNumber {
        line: usize,
        command: &'static str,
        value: String,
    },
    Io {
        line: usize,
        source: io::Error,
    },
}

impl ParseError {
    /// The line the error was found on.
    pub fn line(&self) -> usize {
        match self {
            ParseError::UnknownCommand { line, .. }
            | ParseError::ArgCount { line, .. }
            | ParseError::InvalidNumber { line, .. }
            | ParseError::Io { line, .. } => *line,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::UnknownCommand { line, command } => {
                write!(f, "line {}: unknown command '{}'", line, command)
            }
            ParseError::ArgCount {
                line,
                command,
                expected,
                actual,
            } => write!(
                f,
                "line {}: {} command requires {} arguments, got {}",
                line, command, expected, actual
            ),
            ParseError::InvalidNumber {
                line,
                command,
                value,
            } => write!(
                f,
                "line {}: {} argument '{}' is not a finite number",
                line, command, value
            ),
            ParseError::Io { line, source } => {
                write!(f, "line {}: failed to read script: {}", line, source)
            }
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}
