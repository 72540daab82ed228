use std::str::FromStr;

use crate::client::api::{ClientError, TodoApi};
use crate::client::app::TodoApp;

pub const HELP: &str =
    "commands: add <text> | rm <n> | toggle <n> | edit <n> <text> | list | help | quit";

/// One line of input to the terminal client. Positions are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add(String),
    Remove(usize),
    Toggle(usize),
    Edit(usize, String),
    List,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        let position = |arg: &str| {
            arg.parse::<usize>()
                .map_err(|_| format!("expected an item number, got {arg:?}"))
        };

        match verb.to_ascii_lowercase().as_str() {
            "add" | "a" => Ok(Command::Add(rest.to_string())),
            "rm" | "del" | "delete" => position(rest).map(Command::Remove),
            "toggle" | "t" | "done" => position(rest).map(Command::Toggle),
            "edit" | "e" => {
                let (n, text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                Ok(Command::Edit(position(n)?, text.trim().to_string()))
            }
            "list" | "ls" | "" => Ok(Command::List),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            other => Err(format!("unknown command {other:?}; {HELP}")),
        }
    }
}

impl Command {
    /// Runs the command against the app. Each command maps to at most one
    /// service call.
    pub async fn apply<A: TodoApi>(self, app: &mut TodoApp<A>) -> Result<(), ClientError> {
        match self {
            Command::Add(text) => {
                app.set_input(text);
                app.submit().await
            }
            Command::Remove(n) => {
                let id = app.id_at(n)?;
                app.delete(id).await
            }
            Command::Toggle(n) => {
                let id = app.id_at(n)?;
                app.toggle(id).await
            }
            Command::Edit(n, text) => {
                let id = app.id_at(n)?;
                app.begin_edit(id)?;
                app.set_edit_text(text)?;
                let result = app.save_edit().await;
                if result.is_err() {
                    app.cancel_edit();
                }
                result
            }
            Command::List => app.refresh().await,
            Command::Help | Command::Quit => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!("add  buy milk ".parse::<Command>(), Ok(Command::Add("buy milk".into())));
        assert_eq!("rm 2".parse::<Command>(), Ok(Command::Remove(2)));
        assert_eq!("toggle 1".parse::<Command>(), Ok(Command::Toggle(1)));
        assert_eq!("edit 3 new text".parse::<Command>(), Ok(Command::Edit(3, "new text".into())));
        assert_eq!("".parse::<Command>(), Ok(Command::List));
        assert_eq!("QUIT".parse::<Command>(), Ok(Command::Quit));
    }

    #[test]
    fn rejects_bad_positions_and_verbs() {
        assert!("rm two".parse::<Command>().is_err());
        assert!("frobnicate".parse::<Command>().is_err());
    }
}
