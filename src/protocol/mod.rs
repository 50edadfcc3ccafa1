//! Wire Protocol
//!
//! Requests arrive as arrays of bulk strings and replies go out as the
//! usual RESP reply kinds.
//!
//! ## Modules
//!
//! - `request`: The parsed [`Request`] and its client-side encoding
//! - `parser`: Incremental parser from socket bytes to requests
//! - `types`: The [`RespValue`] reply enum and its serialization
//!
//! ## Example
//!
//! ```
//! use tidekv::protocol::{parse_request, RespValue};
//!
//! let (request, _consumed) = parse_request(b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n")
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(request.command, "GET");
//!
//! let reply = RespValue::bulk_string("Ariz");
//! assert_eq!(reply.serialize(), b"$4\r\nAriz\r\n");
//! ```

pub mod parser;
pub mod request;
pub mod types;

pub use parser::{parse_request, ParseError, ParseResult, RespParser};
pub use request::Request;
pub use types::RespValue;
