//! REPL command parsing.

use thiserror::Error;

use crate::todo::ItemId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown command '{0}', type `help` for the list")]
    Unknown(String),

    #[error("`{command}` needs {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    #[error("'{value}' is not a valid {argument}")]
    InvalidNumber {
        argument: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add(String),
    Toggle(ItemId),
    Rename { id: ItemId, action: String },
    /// Negative distance moves up.
    Move { id: ItemId, distance: i64 },
    Delete(Vec<ItemId>),
    /// Delete every completed item.
    Purge,
    /// Flip the completed-items-last ordering.
    Order,
    Show,
    Stats,
    Export,
    Help,
    Quit,
}

pub const HELP: &str = "\
Commands:
  add <text>             add an item
  toggle <id>            complete or reopen an item
  rename <id> <text>     change an item's text
  move <id> <distance>   move an item, negative moves up
  delete <id>...         delete items
  purge                  delete every completed item
  order                  toggle completed items last
  show                   print the list
  stats                  print render counts
  export                 print the items as JSON
  help                   print this help
  quit                   leave";

impl Command {
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        match word.to_ascii_lowercase().as_str() {
            "" => Err(CommandError::Empty),
            "add" => {
                if rest.is_empty() {
                    return Err(CommandError::MissingArgument {
                        command: "add",
                        argument: "the item text",
                    });
                }
                Ok(Command::Add(rest.to_string()))
            }
            "toggle" => Ok(Command::Toggle(id_arg("toggle", rest)?)),
            "rename" => {
                let (id, action) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                let id = id_arg("rename", id)?;
                let action = action.trim();
                if action.is_empty() {
                    return Err(CommandError::MissingArgument {
                        command: "rename",
                        argument: "the new text",
                    });
                }
                Ok(Command::Rename {
                    id,
                    action: action.to_string(),
                })
            }
            "move" => {
                let mut parts = rest.split_whitespace();
                let id = id_arg("move", parts.next().unwrap_or(""))?;
                let Some(distance) = parts.next() else {
                    return Err(CommandError::MissingArgument {
                        command: "move",
                        argument: "a distance",
                    });
                };
                let distance = distance.parse().map_err(|_| CommandError::InvalidNumber {
                    argument: "distance",
                    value: distance.to_string(),
                })?;
                Ok(Command::Move { id, distance })
            }
            "delete" | "rm" => {
                if rest.is_empty() {
                    return Err(CommandError::MissingArgument {
                        command: "delete",
                        argument: "at least one item id",
                    });
                }
                let ids = rest
                    .split_whitespace()
                    .map(|id| id_arg("delete", id))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Command::Delete(ids))
            }
            "purge" => Ok(Command::Purge),
            "order" => Ok(Command::Order),
            "show" | "ls" => Ok(Command::Show),
            "stats" => Ok(Command::Stats),
            "export" => Ok(Command::Export),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

fn id_arg(command: &'static str, value: &str) -> Result<ItemId, CommandError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CommandError::MissingArgument {
            command,
            argument: "an item id",
        });
    }
    value.trim_start_matches('#').parse().map_err(|_| CommandError::InvalidNumber {
        argument: "item id",
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_with_arguments() {
        assert_eq!(Command::parse("add  buy milk "), Ok(Command::Add("buy milk".to_string())));
        assert_eq!(Command::parse("toggle #3"), Ok(Command::Toggle(3)));
        assert_eq!(
            Command::parse("rename 2 call  mum"),
            Ok(Command::Rename {
                id: 2,
                action: "call  mum".to_string()
            })
        );
        assert_eq!(Command::parse("move 1 -2"), Ok(Command::Move { id: 1, distance: -2 }));
        assert_eq!(Command::parse("delete 1 2 3"), Ok(Command::Delete(vec![1, 2, 3])));
        assert_eq!(Command::parse("QUIT"), Ok(Command::Quit));
    }

    #[test]
    fn reports_bad_input() {
        assert_eq!(Command::parse("   "), Err(CommandError::Empty));
        assert_eq!(Command::parse("fly"), Err(CommandError::Unknown("fly".to_string())));
        assert_eq!(
            Command::parse("toggle"),
            Err(CommandError::MissingArgument {
                command: "toggle",
                argument: "an item id"
            })
        );
        assert_eq!(
            Command::parse("move 1 up"),
            Err(CommandError::InvalidNumber {
                argument: "distance",
                value: "up".to_string()
            })
        );
        assert!(matches!(
            Command::parse("rename 4"),
            Err(CommandError::MissingArgument { command: "rename", .. })
        ));
        assert!(matches!(
            Command::parse("delete 1 x"),
            Err(CommandError::InvalidNumber { .. })
        ));
    }
}
