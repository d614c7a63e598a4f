//! Line-based trace scripts
//!
//! One command per line. Lines starting with `#` are comments:
//!
//! ```text
//! create spawn world 0 60 0 10 70 10
//! action spawn enter message Welcome %entity%
//! connect 1 Steve
//! move 1 world 5 64 5
//! wait 500
//! disconnect 1
//! ```

use std::time::Duration;
use thiserror::Error;

use void_volumes::{Action, ActionParseError, EntityId, Position, TransitionKind};

/// Trace parse errors, tagged with the 1-based line number
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("line {line}: unknown command '{command}'")]
    UnknownCommand { line: usize, command: String },
    #[error("line {line}: usage: {usage}")]
    Usage { line: usize, usage: &'static str },
    #[error("line {line}: invalid number '{token}'")]
    InvalidNumber { line: usize, token: String },
    #[error("line {line}: expected enter, leave or all, got '{token}'")]
    InvalidDirection { line: usize, token: String },
    #[error("line {line}: {source}")]
    UnknownAction {
        line: usize,
        #[source]
        source: ActionParseError,
    },
}

/// One trace command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Entity comes online, optionally at a spawn position
    Connect {
        id: EntityId,
        name: String,
        spawn: Option<Position>,
    },
    /// Entity goes offline
    Disconnect { id: EntityId },
    /// Walk to a position
    Move { id: EntityId, position: Position },
    /// Externally teleported to a position
    Teleport { id: EntityId, position: Position },
    /// Advance the clock
    Wait(Duration),
    /// Advance the clock by whole ticks
    Tick(u32),
    /// Give an entity the trigger permission
    Grant { id: EntityId },
    /// Take the trigger permission away
    Revoke { id: EntityId },
    /// Define a volume from two corners
    Create {
        name: String,
        world: String,
        a: [f64; 3],
        b: [f64; 3],
    },
    /// Delete a volume
    Delete { name: String },
    /// Append an action to a volume or group
    AddAction {
        target: String,
        kind: TransitionKind,
        action: Action,
    },
    /// Clear actions of a volume or group (`None` clears both lists)
    ClearActions {
        target: String,
        kind: Option<TransitionKind>,
    },
    /// Copy both action lists from one volume to another
    CloneActions { source: String, target: String },
    /// Create a group
    Group { name: String, members: Vec<String> },
    /// Delete a group
    Ungroup { name: String },
    /// Add a volume to an existing group
    GroupAdd { group: String, volume: String },
    /// Remove a volume from a group
    GroupRemove { group: String, volume: String },
    /// List every volume
    List,
    /// Show one volume in detail
    Info { name: String },
    /// Replace the store with the file on disk
    Reload,
    /// Write the store to disk
    Save,
    /// Print engine and store state
    Status,
}

/// Parse a whole script, stopping at the first bad line
pub fn parse_script(text: &str) -> Result<Vec<(usize, Command)>, TraceError> {
    let mut commands = Vec::new();
    for (index, line) in text.lines().enumerate() {
        if let Some(command) = parse_line(index + 1, line)? {
            commands.push((index + 1, command));
        }
    }
    Ok(commands)
}

/// Parse one line. Blank lines and comments yield `None`.
pub fn parse_line(line: usize, text: &str) -> Result<Option<Command>, TraceError> {
    if text.trim_start().starts_with('#') {
        return Ok(None);
    }
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let Some((&command, args)) = tokens.split_first() else {
        return Ok(None);
    };
    let p = Parser { line, args };

    let parsed = match command.to_lowercase().as_str() {
        "connect" => {
            p.arity_at_least(2, "connect <id> <name> [world x y z]")?;
            let spawn = match args.len() {
                2 => None,
                6 => Some(p.position(2)?),
                _ => {
                    return Err(TraceError::Usage {
                        line,
                        usage: "connect <id> <name> [world x y z]",
                    })
                }
            };
            Command::Connect {
                id: p.entity(0)?,
                name: args[1].to_string(),
                spawn,
            }
        }
        "disconnect" => {
            p.arity(1, "disconnect <id>")?;
            Command::Disconnect { id: p.entity(0)? }
        }
        "move" => {
            p.arity(5, "move <id> <world> <x> <y> <z>")?;
            Command::Move {
                id: p.entity(0)?,
                position: p.position(1)?,
            }
        }
        "teleport" | "tp" => {
            p.arity(5, "teleport <id> <world> <x> <y> <z>")?;
            Command::Teleport {
                id: p.entity(0)?,
                position: p.position(1)?,
            }
        }
        "wait" => {
            p.arity(1, "wait <millis>")?;
            Command::Wait(Duration::from_millis(p.number::<u64>(0)?))
        }
        "tick" => match args.len() {
            0 => Command::Tick(1),
            1 => Command::Tick(p.number::<u32>(0)?),
            _ => return Err(TraceError::Usage { line, usage: "tick [count]" }),
        },
        "grant" => {
            p.arity(1, "grant <id>")?;
            Command::Grant { id: p.entity(0)? }
        }
        "revoke" => {
            p.arity(1, "revoke <id>")?;
            Command::Revoke { id: p.entity(0)? }
        }
        "create" => {
            p.arity(8, "create <name> <world> <x1> <y1> <z1> <x2> <y2> <z2>")?;
            Command::Create {
                name: args[0].to_string(),
                world: args[1].to_string(),
                a: [p.number(2)?, p.number(3)?, p.number(4)?],
                b: [p.number(5)?, p.number(6)?, p.number(7)?],
            }
        }
        "delete" => {
            p.arity(1, "delete <name>")?;
            Command::Delete {
                name: args[0].to_string(),
            }
        }
        "action" => {
            p.arity_at_least(4, "action <target> <enter|leave> <type> <value...>")?;
            let kind = p
                .direction(1)?
                .ok_or_else(|| TraceError::InvalidDirection {
                    line,
                    token: args[1].to_string(),
                })?;
            let action = Action::parse(args[2], args[3..].join(" "))
                .map_err(|source| TraceError::UnknownAction { line, source })?;
            Command::AddAction {
                target: args[0].to_string(),
                kind,
                action,
            }
        }
        "clear" => {
            let kind = match args.len() {
                1 => None,
                2 => p.direction(1)?,
                _ => {
                    return Err(TraceError::Usage {
                        line,
                        usage: "clear <target> [enter|leave|all]",
                    })
                }
            };
            Command::ClearActions {
                target: args[0].to_string(),
                kind,
            }
        }
        "clone" => {
            p.arity(2, "clone <source> <target>")?;
            Command::CloneActions {
                source: args[0].to_string(),
                target: args[1].to_string(),
            }
        }
        "group" => {
            p.arity_at_least(3, "group <name> <volume> <volume> [volume...]")?;
            Command::Group {
                name: args[0].to_string(),
                members: args[1..].iter().map(|s| s.to_string()).collect(),
            }
        }
        "ungroup" => {
            p.arity(1, "ungroup <name>")?;
            Command::Ungroup {
                name: args[0].to_string(),
            }
        }
        "groupadd" => {
            p.arity(2, "groupadd <group> <volume>")?;
            Command::GroupAdd {
                group: args[0].to_string(),
                volume: args[1].to_string(),
            }
        }
        "groupremove" => {
            p.arity(2, "groupremove <group> <volume>")?;
            Command::GroupRemove {
                group: args[0].to_string(),
                volume: args[1].to_string(),
            }
        }
        "list" => Command::List,
        "info" => {
            p.arity(1, "info <name>")?;
            Command::Info {
                name: args[0].to_string(),
            }
        }
        "reload" => Command::Reload,
        "save" => Command::Save,
        "status" => Command::Status,
        other => {
            return Err(TraceError::UnknownCommand {
                line,
                command: other.to_string(),
            })
        }
    };
    Ok(Some(parsed))
}

struct Parser<'a> {
    line: usize,
    args: &'a [&'a str],
}

impl Parser<'_> {
    fn arity(&self, count: usize, usage: &'static str) -> Result<(), TraceError> {
        if self.args.len() == count {
            Ok(())
        } else {
            Err(TraceError::Usage { line: self.line, usage })
        }
    }

    fn arity_at_least(&self, count: usize, usage: &'static str) -> Result<(), TraceError> {
        if self.args.len() >= count {
            Ok(())
        } else {
            Err(TraceError::Usage { line: self.line, usage })
        }
    }

    fn number<T: std::str::FromStr>(&self, index: usize) -> Result<T, TraceError> {
        let token = self.args[index];
        token.parse().map_err(|_| TraceError::InvalidNumber {
            line: self.line,
            token: token.to_string(),
        })
    }

    fn entity(&self, index: usize) -> Result<EntityId, TraceError> {
        self.number::<u64>(index).map(EntityId)
    }

    /// `world x y z` starting at `index`
    fn position(&self, index: usize) -> Result<Position, TraceError> {
        let coord = |i: usize| -> Result<f64, TraceError> {
            let value: f64 = self.number(i)?;
            if value.is_finite() {
                Ok(value)
            } else {
                Err(TraceError::InvalidNumber {
                    line: self.line,
                    token: self.args[i].to_string(),
                })
            }
        };
        Ok(Position::new(
            self.args[index],
            coord(index + 1)?,
            coord(index + 2)?,
            coord(index + 3)?,
        ))
    }

    /// `enter`, `leave`, or `all` (`None`)
    fn direction(&self, index: usize) -> Result<Option<TransitionKind>, TraceError> {
        match self.args[index].to_lowercase().as_str() {
            "enter" => Ok(Some(TransitionKind::Enter)),
            "leave" => Ok(Some(TransitionKind::Leave)),
            "all" => Ok(None),
            other => Err(TraceError::InvalidDirection {
                line: self.line,
                token: other.to_string(),
            }),
        }
    }
}
