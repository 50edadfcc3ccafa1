//! Command Handler Module
//!
//! Executes parsed requests against the store and builds the reply.
//!
//! ## Supported Commands
//!
//! ### String Commands
//! - `SET key value` - Set a key (an existing TTL is kept)
//! - `GET key` - Get a key's value
//! - `INCR key` / `DECR key` - Add or subtract one, creating the key at ±1
//!
//! ### List Commands
//! - `LPUSH key value [value ...]` - Put values at the head, in the order given
//! - `RPUSH key value [value ...]` - Put values at the tail
//! - `LPOP key` / `RPOP key` - Remove and return the head / tail element
//! - `LRANGE key start stop` - Elements from `start` to `stop`, both inclusive
//! - `LLEN key` - Length of a list
//!
//! ### Key Commands
//! - `DEL key [key ...]` - Delete keys
//! - `EXPIRE key seconds` - Set a TTL
//! - `TTL key` - Remaining TTL in seconds (-1 none, -2 missing)
//!
//! ### Server Commands
//! - `PING` - Test connection
//! - `COMMAND` - Acknowledge (sent by `redis-cli` on connect)
//!
//! ## Errors
//!
//! Every failure is a [`CommandError`] and becomes an `-ERR` reply here;
//! no error reaches the connection layer.

use crate::protocol::{Request, RespValue};
use crate::storage::{Db, Entry, Store, Ttl};
use std::collections::VecDeque;
use thiserror::Error;
use tracing::debug;

/// Errors a command can fail with. Each one becomes `-ERR <message>`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("wrong number of arguments for '{0}' command")]
    WrongArity(&'static str),

    /// The key holds a different kind of value than the command needs
    #[error("wrong type of key")]
    WrongType,

    #[error("value is not an integer or out of range")]
    NotAnInteger,

    #[error("unknown command")]
    UnknownCommand,
}

impl CommandError {
    /// Converts the error into its wire reply.
    pub fn into_reply(self) -> RespValue {
        RespValue::error(format!("ERR {}", self))
    }
}

type CommandResult = Result<RespValue, CommandError>;

/// Executes requests against a shared store.
///
/// Cloning is cheap; every connection gets its own clone.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    db: Db,
}

impl CommandHandler {
    /// Creates a new command handler over the given store.
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Returns the store this handler executes against.
    pub fn db(&self) -> &Db {
        &self.db
    }

    /// Executes a request and returns the reply.
    ///
    /// The store stays locked for the whole command, so commands never
    /// interleave.
    pub fn execute(&self, request: &Request) -> RespValue {
        debug!(
            command = %request.command,
            args = request.args.len(),
            "Received command"
        );

        let mut store = self.db.lock();
        dispatch(&mut store, &request.command, &request.args)
            .unwrap_or_else(CommandError::into_reply)
    }
}

/// Dispatches a command to its handler.
fn dispatch(store: &mut Store, cmd: &str, args: &[String]) -> CommandResult {
    match cmd {
        // String commands
        "SET" => cmd_set(store, args),
        "GET" => cmd_get(store, args),
        "INCR" => cmd_incr_by(store, args, "INCR", 1),
        "DECR" => cmd_incr_by(store, args, "DECR", -1),

        // List commands
        "LPUSH" => cmd_lpush(store, args),
        "RPUSH" => cmd_rpush(store, args),
        "LPOP" => cmd_pop(store, args, "LPOP", VecDeque::pop_front),
        "RPOP" => cmd_pop(store, args, "RPOP", VecDeque::pop_back),
        "LRANGE" => cmd_lrange(store, args),
        "LLEN" => cmd_llen(store, args),

        // Key commands
        "DEL" => cmd_del(store, args),
        "EXPIRE" => cmd_expire(store, args),
        "TTL" => cmd_ttl(store, args),

        // Server commands
        "PING" => Ok(RespValue::pong()),
        "COMMAND" => Ok(RespValue::ok()),

        _ => Err(CommandError::UnknownCommand),
    }
}

// ============================================================================
// Helper functions
// ============================================================================

/// Fails unless at least `min` arguments were given.
fn check_arity(name: &'static str, args: &[String], min: usize) -> Result<(), CommandError> {
    if args.len() < min {
        return Err(CommandError::WrongArity(name));
    }
    Ok(())
}

fn parse_int(s: &str) -> Result<i64, CommandError> {
    s.parse().map_err(|_| CommandError::NotAnInteger)
}

/// Resolves `key` as a list, `None` if it does not exist.
fn list_mut<'a>(
    store: &'a mut Store,
    key: &str,
) -> Result<Option<&'a mut VecDeque<String>>, CommandError> {
    match store.resolve(key) {
        None => Ok(None),
        Some(Entry::List(items)) => Ok(Some(items)),
        Some(_) => Err(CommandError::WrongType),
    }
}

/// Resolves `key` as a list, creating an empty one if it does not exist.
fn list_or_create<'a>(
    store: &'a mut Store,
    key: &str,
) -> Result<&'a mut VecDeque<String>, CommandError> {
    match store.get_or_insert_with(key, Entry::empty_list) {
        Entry::List(items) => Ok(items),
        _ => Err(CommandError::WrongType),
    }
}

// ============================================================================
// String Commands
// ============================================================================

/// SET key value
fn cmd_set(store: &mut Store, args: &[String]) -> CommandResult {
    check_arity("SET", args, 2)?;
    store.set(args[0].as_str(), Entry::String(args[1].clone()));
    Ok(RespValue::ok())
}

/// GET key
fn cmd_get(store: &mut Store, args: &[String]) -> CommandResult {
    check_arity("GET", args, 1)?;
    match store.resolve(&args[0]) {
        None => Ok(RespValue::null()),
        Some(Entry::String(value)) => Ok(RespValue::bulk_string(value.clone())),
        Some(_) => Err(CommandError::WrongType),
    }
}

/// INCR key / DECR key
fn cmd_incr_by(store: &mut Store, args: &[String], name: &'static str, delta: i64) -> CommandResult {
    check_arity(name, args, 1)?;
    let key = &args[0];

    match store.resolve(key) {
        None => {
            store.set(key.as_str(), Entry::String(delta.to_string()));
            Ok(RespValue::integer(delta))
        }
        Some(Entry::String(value)) => {
            let updated = parse_int(value)?
                .checked_add(delta)
                .ok_or(CommandError::NotAnInteger)?;
            *value = updated.to_string();
            Ok(RespValue::integer(updated))
        }
        Some(_) => Err(CommandError::WrongType),
    }
}

// ============================================================================
// List Commands
// ============================================================================

/// LPUSH key value [value ...]
///
/// The values land at the head in the order given: `LPUSH k a b` on an
/// empty key yields `[a, b]`.
fn cmd_lpush(store: &mut Store, args: &[String]) -> CommandResult {
    check_arity("LPUSH", args, 2)?;
    let items = list_or_create(store, &args[0])?;
    for value in args[1..].iter().rev() {
        items.push_front(value.clone());
    }
    Ok(RespValue::integer(items.len() as i64))
}

/// RPUSH key value [value ...]
fn cmd_rpush(store: &mut Store, args: &[String]) -> CommandResult {
    check_arity("RPUSH", args, 2)?;
    let items = list_or_create(store, &args[0])?;
    items.extend(args[1..].iter().cloned());
    Ok(RespValue::integer(items.len() as i64))
}

/// LPOP key / RPOP key
///
/// An emptied list stays in the store.
fn cmd_pop(
    store: &mut Store,
    args: &[String],
    name: &'static str,
    pop: fn(&mut VecDeque<String>) -> Option<String>,
) -> CommandResult {
    check_arity(name, args, 1)?;
    let popped = list_mut(store, &args[0])?.and_then(pop);
    Ok(popped.map_or_else(RespValue::null, RespValue::bulk_string))
}

/// LRANGE key start stop
///
/// Negative indices count from the end. Out-of-range indices are clamped.
fn cmd_lrange(store: &mut Store, args: &[String]) -> CommandResult {
    check_arity("LRANGE", args, 3)?;
    let start = parse_int(&args[1])?;
    let stop = parse_int(&args[2])?;

    let items = match list_mut(store, &args[0])? {
        Some(items) => items,
        None => return Ok(RespValue::null()),
    };

    let len = items.len() as i64;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };

    if start > stop || start >= len {
        return Ok(RespValue::bulk_array(Vec::<String>::new()));
    }

    let range = items
        .range(start as usize..=stop as usize)
        .cloned()
        .collect::<Vec<_>>();
    Ok(RespValue::bulk_array(range))
}

/// LLEN key
fn cmd_llen(store: &mut Store, args: &[String]) -> CommandResult {
    check_arity("LLEN", args, 1)?;
    let len = list_mut(store, &args[0])?.map_or(0, |items| items.len());
    Ok(RespValue::integer(len as i64))
}

// ============================================================================
// Key Commands
// ============================================================================

/// DEL key [key ...]
fn cmd_del(store: &mut Store, args: &[String]) -> CommandResult {
    check_arity("DEL", args, 1)?;
    let mut deleted = 0;
    for key in args {
        if store.delete(key) {
            deleted += 1;
        }
    }
    Ok(RespValue::integer(deleted))
}

/// EXPIRE key seconds
fn cmd_expire(store: &mut Store, args: &[String]) -> CommandResult {
    check_arity("EXPIRE", args, 2)?;
    let seconds = parse_int(&args[1])?;
    let applied = store.set_ttl(&args[0], seconds);
    Ok(RespValue::integer(applied as i64))
}

/// TTL key
fn cmd_ttl(store: &mut Store, args: &[String]) -> CommandResult {
    check_arity("TTL", args, 1)?;
    let ttl = match store.ttl(&args[0]) {
        Ttl::Missing => -2,
        Ttl::Persistent => -1,
        Ttl::Remaining(ms) => ms / 1000,
    };
    Ok(RespValue::integer(ttl))
}
