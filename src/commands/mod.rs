//! Command Module
//!
//! The command layer sits between the wire and the store. It takes a
//! parsed [`Request`](crate::protocol::Request), runs it against the
//! shared [`Db`](crate::storage::Db) and produces exactly one reply.
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │  RESP Parser    │  (protocol module)
//! └────────┬────────┘
//!          │ Request
//!          ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  (this module)
//! │  - Arity check  │
//! │  - Dispatch     │
//! │  - Execute      │
//! └────────┬────────┘
//!          │ one lock per command
//!          ▼
//! ┌─────────────────┐
//! │    Db / Store   │  (storage module)
//! └─────────────────┘
//! ```
//!
//! Command names match case-insensitively (the parser upper-cases them).
//! Argument counts are minimums; extra arguments are ignored.

pub mod handler;

pub use handler::{CommandError, CommandHandler};
