// src/lang/parser.rs

//! Turns script text into operations.

use super::commands::Command;
use super::ParseError;
use crate::operation::Operation;
use crate::scene::SceneHandle;
use log::{debug, trace};
use std::io::BufRead;

/// Line-oriented script parser.
///
/// Stateless apart from the number given to the first line, so a batch cut
/// out of a larger script reports errors against whole-script line numbers.
#[derive(Debug, Clone, Copy)]
pub struct Parser {
    first_line: usize,
}

impl Default for Parser {
    fn default() -> Self {
        Parser { first_line: 1 }
    }
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    /// A parser whose first input line is numbered `first_line`.
    pub fn starting_at(first_line: usize) -> Self {
        Parser {
            first_line: first_line.max(1),
        }
    }

    /// Parses the whole script and binds every command to `scene`.
    ///
    /// Nothing is returned unless every line parsed.
    pub fn parse<R: BufRead>(
        &self,
        reader: R,
        scene: &SceneHandle,
    ) -> Result<Vec<Box<dyn Operation>>, ParseError> {
        let commands = self.parse_commands(reader)?;
        Ok(commands
            .into_iter()
            .map(|command| command.into_operation(scene))
            .collect())
    }

    /// Parses the whole script into scene-independent commands.
    pub fn parse_commands<R: BufRead>(&self, reader: R) -> Result<Vec<Command>, ParseError> {
        let mut commands = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line_no = self.first_line + index;
            let text = line.map_err(|source| ParseError::Io {
                line: line_no,
                source,
            })?;
            if let Some(command) = parse_line(line_no, &text)? {
                trace!("Parser: line {}: {:?}", line_no, command);
                commands.push(command);
            }
        }
        debug!("Parser: parsed {} commands", commands.len());
        Ok(commands)
    }
}

/// Parses one line. Blank lines yield `None`.
pub fn parse_line(line: usize, text: &str) -> Result<Option<Command>, ParseError> {
    let mut tokens = text.split_whitespace();
    let Some(keyword) = tokens.next() else {
        return Ok(None);
    };
    let raw: Vec<&str> = tokens.collect();

    let command = match keyword {
        "white" => {
            arguments::<0>(line, "white", &raw)?;
            Command::White
        }
        "green" => {
            arguments::<0>(line, "green", &raw)?;
            Command::Green
        }
        "update" => {
            arguments::<0>(line, "update", &raw)?;
            Command::Update
        }
        "bgrect" => {
            let [x1, y1, x2, y2] = arguments(line, "bgrect", &raw)?;
            Command::BgRect { x1, y1, x2, y2 }
        }
        "figure" => {
            let [x, y] = arguments(line, "figure", &raw)?;
            Command::Figure { x, y }
        }
        "move" => {
            let [x, y] = arguments(line, "move", &raw)?;
            Command::Move { x, y }
        }
        "reset" => {
            arguments::<0>(line, "reset", &raw)?;
            Command::Reset
        }
        _ => {
            return Err(ParseError::UnknownCommand {
                line,
                command: keyword.to_string(),
            })
        }
    };
    Ok(Some(command))
}

/// Checks the argument count and parses every argument as a number.
fn arguments<const N: usize>(
    line: usize,
    command: &'static str,
    raw: &[&str],
) -> Result<[f64; N], ParseError> {
    if raw.len() != N {
        return Err(ParseError::ArgCount {
            line,
            command,
            expected: N,
            actual: raw.len(),
        });
    }
    let mut args = [0.0; N];
    for (slot, value) in args.iter_mut().zip(raw) {
        *slot = parse_number(line, command, value)?;
    }
    Ok(args)
}

fn parse_number(line: usize, command: &'static str, value: &str) -> Result<f64, ParseError> {
    match value.parse::<f64>() {
        Ok(number) if number.is_finite() => Ok(number),
        _ => Err(ParseError::InvalidNumber {
            line,
            command,
            value: value.to_string(),
        }),
    }
}

/// A run of consecutive non-blank lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Number of the batch's first line in the whole input (1-based).
    pub first_line: usize,
    pub text: String,
}

impl Batch {
    /// Parses this batch, reporting errors against whole-input line numbers.
    pub fn parse(&self, scene: &SceneHandle) -> Result<Vec<Box<dyn Operation>>, ParseError> {
        Parser::starting_at(self.first_line).parse(self.text.as_bytes(), scene)
    }
}

/// Splits a script into blank-line separated batches as it is read.
///
/// Each batch is yielded as soon as the blank line (or end of input) closing
/// it is read, so interactive input is processed batch by batch.
pub struct BatchReader<R> {
    lines: std::io::Lines<R>,
    line_no: usize,
}

impl<R: BufRead> BatchReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
        }
    }
}

impl<R: BufRead> Iterator for BatchReader<R> {
    type Item = Result<Batch, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut batch: Option<Batch> = None;
        for line in self.lines.by_ref() {
            self.line_no += 1;
            let text = match line {
                Ok(text) => text,
                Err(source) => {
                    return Some(Err(ParseError::Io {
                        line: self.line_no,
                        source,
                    }))
                }
            };

            if text.trim().is_empty() {
                if batch.is_some() {
                    break;
                }
                continue;
            }

            let current = batch.get_or_insert_with(|| Batch {
                first_line: self.line_no,
                text: String::new(),
            });
            current.text.push_str(&text);
            current.text.push('\n');
        }
        batch.map(Ok)
    }
}
