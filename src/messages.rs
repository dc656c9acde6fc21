use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

use crate::presence::Presence;

/// A presence transition, as published to subscribers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PresenceEvent {
    pub device: String,
    pub presence: Presence,
}

/// One line of the activity feed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Register {
        device: String,
        awake_time_ms: Option<i64>,
    },
    Deregister(/* device */ String),
    Awake(/* device */ String),
    Sleep(/* device */ String),
    Status,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command `{0}`")]
    Unknown(String),
    #[error("`{0}` needs a device name")]
    MissingDevice(&'static str),
    #[error("awake time `{0}` is not an integer")]
    BadAwakeTime(String),
    #[error("unexpected argument `{0}`")]
    TrailingArgument(String),
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let verb = words.next().ok_or(CommandError::Empty)?;

        let command = match verb.to_lowercase().as_str() {
            "register" => {
                let device = device_arg(&mut words, "register")?;
                let awake_time_ms = words
                    .next()
                    .map(|ms| {
                        ms.parse::<i64>()
                            .map_err(|_| CommandError::BadAwakeTime(ms.to_string()))
                    })
                    .transpose()?;
                Command::Register {
                    device,
                    awake_time_ms,
                }
            }
            "deregister" => Command::Deregister(device_arg(&mut words, "deregister")?),
            "awake" => Command::Awake(device_arg(&mut words, "awake")?),
            "sleep" => Command::Sleep(device_arg(&mut words, "sleep")?),
            "status" => Command::Status,
            "quit" | "exit" => Command::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };

        match words.next() {
            Some(extra) => Err(CommandError::TrailingArgument(extra.to_string())),
            None => Ok(command),
        }
    }
}

fn device_arg<'a>(
    words: &mut impl Iterator<Item = &'a str>,
    verb: &'static str,
) -> Result<String, CommandError> {
    words
        .next()
        .map(str::to_string)
        .ok_or(CommandError::MissingDevice(verb))
}
