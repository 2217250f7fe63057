//! Console command parsing.
//!
//! Syntax: `<command> [@namespace] [args...]`. A leading `@name` token picks
//! the namespace for that one command.

use serde_json::Value;
use thiserror::Error;

use crate::events::CacheCommand;

/// A line the console could not turn into a command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command '{0}' (try 'help')")]
    UnknownCommand(String),

    #[error("'{command}' needs a {name}")]
    MissingArgument {
        command: &'static str,
        name: &'static str,
    },

    #[error("'{0}' takes no further arguments")]
    TooManyArguments(&'static str),
}

/// One console command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Published on the event hub.
    Cache(CacheCommand),
    Keys { namespace: Option<String> },
    Namespaces,
    Use(String),
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  create [@ns]              create a namespace
  add [@ns] <key> <json>    store a value (non-JSON text is stored as a string)
  get [@ns] <key>           read a value
  remove [@ns] <key>        remove a value
  clear [@ns]               empty a namespace
  keys [@ns]                list keys, removed ones included
  namespaces                list namespaces
  use <ns>                  change the default namespace
  help                      show this text
  quit                      leave";

/// Parse one input line. Blank lines and `#` comments yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (name, rest) = split_token(line);
    let name = name.to_lowercase();
    let (namespace, rest) = if name == "use" {
        (None, rest)
    } else {
        namespace_prefix(rest)
    };

    let command = match name.as_str() {
        "create" => {
            no_more("create", rest)?;
            Command::Cache(CacheCommand::Create { namespace })
        }
        "add" | "set" => {
            let (key, raw) = split_token(rest);
            let key = required("add", "key", key)?;
            let raw = required("add", "value", raw)?;
            Command::Cache(CacheCommand::Add {
                key,
                value: parse_value(&raw),
                namespace,
            })
        }
        "get" => {
            let (key, rest) = split_token(rest);
            no_more("get", rest)?;
            Command::Cache(CacheCommand::Get {
                key: required("get", "key", key)?,
                namespace,
            })
        }
        "remove" | "rm" | "del" => {
            let (key, rest) = split_token(rest);
            no_more("remove", rest)?;
            Command::Cache(CacheCommand::Remove {
                key: required("remove", "key", key)?,
                namespace,
            })
        }
        "clear" => {
            no_more("clear", rest)?;
            Command::Cache(CacheCommand::Clear { namespace })
        }
        "keys" | "ls" => {
            no_more("keys", rest)?;
            Command::Keys { namespace }
        }
        "namespaces" | "ns" => {
            no_more("namespaces", rest)?;
            Command::Namespaces
        }
        "use" => {
            let (ns, rest) = split_token(rest);
            no_more("use", rest)?;
            Command::Use(required("use", "namespace", ns)?)
        }
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(CommandError::UnknownCommand(other.to_string())),
    };

    Ok(Some(command))
}

/// JSON if it parses, otherwise the raw text as a JSON string.
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Split off a leading `@name` token. A lone `@` is not a namespace.
fn namespace_prefix(rest: &str) -> (Option<String>, &str) {
    let (token, after) = split_token(rest);
    match token.strip_prefix('@') {
        Some(ns) if !ns.is_empty() => (Some(ns.to_string()), after),
        _ => (None, rest),
    }
}

fn split_token(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(idx) => (&s[..idx], s[idx..].trim()),
        None => (s, ""),
    }
}

fn required(
    command: &'static str,
    name: &'static str,
    value: &str,
) -> Result<String, CommandError> {
    if value.is_empty() {
        Err(CommandError::MissingArgument { command, name })
    } else {
        Ok(value.to_string())
    }
}

fn no_more(command: &'static str, rest: &str) -> Result<(), CommandError> {
    if rest.is_empty() {
        Ok(())
    } else {
        Err(CommandError::TooManyArguments(command))
    }
}
