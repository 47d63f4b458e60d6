//! `::name args` commands typed into the chat box.

use engine_core::{EventChain, Flow};
use space::position::HEIGHT_LEVELS;
use space::Position;

use crate::model::Player;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArgumentError {
    #[error("no argument at index {index} ({len} given)")]
    Missing { index: usize, len: usize },

    #[error("argument {value:?} at index {index} is not a valid {expected}")]
    Invalid {
        index: usize,
        value: String,
        expected: &'static str,
    },
}

/// Arguments following a command name. Double-quoted runs form a single argument.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandArguments {
    arguments: Vec<String>,
}

impl CommandArguments {
    pub fn new(arguments: Vec<String>) -> Self {
        Self { arguments }
    }

    pub fn parse(text: &str) -> Self {
        Self::new(split_quoted(text))
    }

    pub fn len(&self) -> usize {
        self.arguments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arguments.is_empty()
    }

    pub fn has(&self, amount: usize) -> bool {
        self.arguments.len() >= amount
    }

    pub fn string(&self, index: usize) -> Result<&str, ArgumentError> {
        self.arguments
            .get(index)
            .map(String::as_str)
            .ok_or(ArgumentError::Missing {
                index,
                len: self.arguments.len(),
            })
    }

    pub fn integer(&self, index: usize) -> Result<i32, ArgumentError> {
        self.parsed(index, "integer")
    }

    pub fn long(&self, index: usize) -> Result<i64, ArgumentError> {
        self.parsed(index, "long")
    }

    pub fn double(&self, index: usize) -> Result<f64, ArgumentError> {
        self.parsed(index, "double")
    }

    /// Only `true` or `false`, in any case.
    pub fn boolean(&self, index: usize) -> Result<bool, ArgumentError> {
        let value = self.string(index)?;
        if value.eq_ignore_ascii_case("true") {
            Ok(true)
        } else if value.eq_ignore_ascii_case("false") {
            Ok(false)
        } else {
            Err(ArgumentError::Invalid {
                index,
                value: value.to_owned(),
                expected: "boolean",
            })
        }
    }

    fn parsed<T: std::str::FromStr>(&self, index: usize, expected: &'static str) -> Result<T, ArgumentError> {
        let value = self.string(index)?;
        value.parse().map_err(|_| ArgumentError::Invalid {
            index,
            value: value.to_owned(),
            expected,
        })
    }
}

/// Splits on spaces, keeping double-quoted runs together without their quotes.
fn split_quoted(text: &str) -> Vec<String> {
    let mut arguments = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for c in text.chars() {
        match c {
            '"' => quoted = !quoted,
            ' ' if !quoted => {
                if !current.is_empty() {
                    arguments.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        arguments.push(current);
    }
    arguments
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandEvent {
    pub name: String,
    pub arguments: CommandArguments,
}

impl CommandEvent {
    /// The first space-separated token is the name; the rest are the arguments.
    pub fn parse(text: &str) -> Self {
        let (name, rest) = text.split_once(' ').unwrap_or((text, ""));
        Self {
            name: name.to_owned(),
            arguments: CommandArguments::parse(rest),
        }
    }
}

pub type CommandChain = EventChain<Player, CommandEvent>;

/// A chain holding the built-in commands.
pub fn default_commands() -> CommandChain {
    let mut chain = CommandChain::new();
    chain.add(position_command);
    chain.add(teleport_command);
    chain
}

fn position_command(player: &mut Player, event: &CommandEvent) -> Flow {
    if event.name != "pos" {
        return Flow::Continue;
    }
    let position = player.position();
    player.send_message(format!("You are standing at: {position}"));
    Flow::Stop
}

fn teleport_command(player: &mut Player, event: &CommandEvent) -> Flow {
    if event.name != "tele-to" {
        return Flow::Continue;
    }
    let arguments = &event.arguments;
    if !arguments.has(2) {
        player.send_message("There are 2 required arguments: ::tele-to [x, y, optional-height]");
        return Flow::Stop;
    }

    let parsed = (|| {
        let x = arguments.integer(0)?;
        let y = arguments.integer(1)?;
        let height = if arguments.has(3) {
            arguments.integer(2)?
        } else {
            player.position().height as i32
        };
        Ok::<_, ArgumentError>((x, y, height))
    })();

    match parsed {
        Ok((x, y, height)) if (0..HEIGHT_LEVELS as i32).contains(&height) => {
            player.stop_movement();
            player.teleport(Position::new(x, y, height as u8));
        }
        Ok((_, _, height)) => {
            player.send_message(format!("Height must be between 0 and {}, not {height}.", HEIGHT_LEVELS - 1));
        }
        Err(e) => {
            tracing::debug!(player = %player.username(), error = %e, "bad tele-to arguments");
            player.send_message("The arguments for this command may only be numeric.");
        }
    }
    Flow::Stop
}
