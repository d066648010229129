// xiqctl - bulk VLAN / user profile tool for ExtremeCloud IQ
// Copyright (C) 2024 Mathias Uhl <mathiasuhl@gmx.de>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Interactive prompts that turn operator answers into a run plan.
//!
//! The driver only decides *what* to do. Executing the plan is left to the
//! caller so that a declined or invalid answer never touches the API.

use crate::models::MAX_VLAN_ID;
use std::io::{self, BufRead, Write};
use thiserror::Error;

const BANNER: &str = "\nThis tool has two options:\n\n\
1) Create VLANs between a range of numbers.\n \
- VLAN object name will match the VLAN ID.\n \
- A corresponding User Profile may be created.\n\n\
2) Delete all VLANs & User Profiles to start over.\n";

const DELETE_CAUTION: &str = "\n*** CAUTION NUCLEAR OPTION CHOSEN *** User Profiles MUST be deleted since they're a dependency. ***";

#[derive(Debug, Error)]
pub enum InputError {
    #[error("You must enter 1 or 2: Aborting...")]
    InvalidMode,
    #[error("You must enter a number from 0 to 4094: Aborting...")]
    NotANumber,
    #[error("Invalid VLAN ID entry: {0}. Aborting...")]
    OutOfRange(i64),
    #[error("Must provide a valid answer Yes or No.")]
    InvalidAnswer,
    #[error("VLANs will not be deleted.")]
    DeleteDeclined,
    #[error("No input received: Aborting...")]
    EndOfInput,
    #[error("reading input: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Create,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
}

/// What the operator asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    Create {
        start: u16,
        end: u16,
        with_user_profile: bool,
    },
    Delete,
}

#[derive(Debug)]
pub enum State {
    AwaitMode,
    AwaitRange,
    AwaitProfileChoice { start: u16, end: u16 },
    AwaitDeleteConfirm,
    Executing(Plan),
    Aborted(InputError),
}

pub fn parse_mode(input: &str) -> Result<Mode, InputError> {
    match input.trim().parse::<i64>() {
        Ok(1) => Ok(Mode::Create),
        Ok(2) => Ok(Mode::Delete),
        _ => Err(InputError::InvalidMode),
    }
}

pub fn parse_number(input: &str) -> Result<i64, InputError> {
    input
        .trim()
        .parse::<i64>()
        .map_err(|_| InputError::NotANumber)
}

/// A VLAN tag in `0..=4094`.
pub fn parse_vlan_id(input: &str) -> Result<u16, InputError> {
    let value = parse_number(input)?;
    u16::try_from(value)
        .ok()
        .filter(|v| *v <= MAX_VLAN_ID)
        .ok_or(InputError::OutOfRange(value))
}

/// Case-insensitive Y/YE/YES or N/NO.
pub fn parse_answer(input: &str) -> Result<Answer, InputError> {
    match input.trim().to_ascii_uppercase().as_str() {
        "Y" | "YE" | "YES" => Ok(Answer::Yes),
        "N" | "NO" => Ok(Answer::No),
        _ => Err(InputError::InvalidAnswer),
    }
}

pub struct Driver<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Driver<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Ask questions until the run is either planned or aborted.
    pub fn run(&mut self) -> Result<Plan, InputError> {
        let mut state = State::AwaitMode;
        loop {
            state = match state {
                State::Executing(plan) => return Ok(plan),
                State::Aborted(err) => return Err(err),
                other => self.step(other).unwrap_or_else(State::Aborted),
            };
        }
    }

    /// Advance one prompt.
    pub fn step(&mut self, state: State) -> Result<State, InputError> {
        let next = match state {
            State::AwaitMode => {
                writeln!(self.output, "{}", BANNER)?;
                let line = self.ask("Do you want to (1)Create or (2)Delete VLANs? [1|2]: ")?;
                match parse_mode(&line)? {
                    Mode::Create => State::AwaitRange,
                    Mode::Delete => State::AwaitDeleteConfirm,
                }
            }
            State::AwaitRange => {
                let start = parse_vlan_id(
                    &self.ask(&format!("Enter first VLAN ID (0~{MAX_VLAN_ID}) to create: "))?,
                )?;
                let end = parse_vlan_id(
                    &self.ask(&format!("Enter last VLAN ID (0~{MAX_VLAN_ID}) to create: "))?,
                )?;
                State::AwaitProfileChoice { start, end }
            }
            State::AwaitProfileChoice { start, end } => {
                let line = self.ask("Create a corresponding User Profile? [Yes|No] ")?;
                let with_user_profile = parse_answer(&line)? == Answer::Yes;
                State::Executing(Plan::Create {
                    start,
                    end,
                    with_user_profile,
                })
            }
            State::AwaitDeleteConfirm => {
                writeln!(self.output, "{}", DELETE_CAUTION)?;
                let line =
                    self.ask("\nAre you sure you want to DELETE all VLANs & USER PROFILES? [Yes|No]: ")?;
                match parse_answer(&line) {
                    Ok(Answer::Yes) => State::Executing(Plan::Delete),
                    _ => return Err(InputError::DeleteDeclined),
                }
            }
            done @ (State::Executing(_) | State::Aborted(_)) => done,
        };
        Ok(next)
    }

    fn ask(&mut self, question: &str) -> Result<String, InputError> {
        write!(self.output, "{}", question)?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(InputError::EndOfInput);
        }
        Ok(line)
    }
}
