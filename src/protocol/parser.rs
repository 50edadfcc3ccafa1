//! Request Parser
//!
//! Turns raw socket bytes into [`Request`]s. A request is an array header
//! followed by that many bulk strings:
//!
//! ```text
//! *3\r\n
//! $5\r\nRPUSH\r\n
//! $4\r\npage\r\n
//! $5\r\n<div>\r\n
//! ```
//!
//! ## How the Parser Works
//!
//! [`RespParser::parse`] reads from the front of a buffer and returns either:
//! - `Ok(Some((request, consumed)))` - one complete request; `consumed` bytes were used
//! - `Ok(None)` - the request is not complete yet, wait for more data
//! - `Err(ParseError)` - the bytes can never form a valid request
//!
//! The caller keeps unconsumed bytes around, so a request split across
//! several reads is reassembled and several requests in one read are
//! handled one at a time.

use crate::protocol::request::Request;
use crate::protocol::types::{prefix, CRLF};
use thiserror::Error;

/// Errors that can occur while parsing a request.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    /// An array with no elements, or a nil array
    #[error("empty request")]
    EmptyRequest,

    /// The request does not start with an array header
    #[error("expected array, got prefix {0:#04x}")]
    ExpectedArray(u8),

    /// An array element is not a bulk string
    #[error("expected bulk string, got prefix {0:#04x}")]
    ExpectedBulkString(u8),

    /// A length header is not a valid integer
    #[error("invalid integer: {0}")]
    InvalidInteger(String),

    /// A bulk string is not valid UTF-8
    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(String),

    #[error("invalid bulk string length: {0}")]
    InvalidBulkLength(i64),

    #[error("invalid array length: {0}")]
    InvalidArrayLength(i64),

    /// Framing violation (missing CRLF, overlong header, ...)
    #[error("protocol error: {0}")]
    ProtocolError(String),

    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Maximum size for a single bulk string (512 MB)
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Maximum number of elements in one request
pub const MAX_ARRAY_LEN: usize = 1024 * 1024;

/// Longest accepted header line, prefix and digits included
const MAX_HEADER_LEN: usize = 32;

/// Parser for inbound requests.
///
/// # Example
///
/// ```
/// use tidekv::protocol::{RespParser, Request};
///
/// let mut parser = RespParser::new();
/// let (request, consumed) = parser
///     .parse(b"*2\r\n$4\r\nllen\r\n$4\r\npage\r\n")
///     .unwrap()
///     .unwrap();
///
/// assert_eq!(request, Request::new("LLEN", ["page"]));
/// assert_eq!(consumed, 24);
/// ```
#[derive(Debug, Clone)]
pub struct RespParser {
    max_bulk_size: usize,
    max_array_len: usize,
}

impl Default for RespParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RespParser {
    /// Creates a parser with the default limits.
    pub fn new() -> Self {
        Self {
            max_bulk_size: MAX_BULK_SIZE,
            max_array_len: MAX_ARRAY_LEN,
        }
    }

    /// Caps the size of a single bulk string.
    pub fn with_max_bulk_size(mut self, max: usize) -> Self {
        self.max_bulk_size = max;
        self
    }

    /// Attempts to parse one request from the front of `buf`.
    pub fn parse(&mut self, buf: &[u8]) -> ParseResult<Option<(Request, usize)>> {
        if buf.is_empty() {
            return Ok(None);
        }
        if buf[0] != prefix::ARRAY {
            return Err(ParseError::ExpectedArray(buf[0]));
        }

        let (count, mut pos) = match read_header(buf, 0)? {
            Some(header) => header,
            None => return Ok(None),
        };

        match count {
            -1 | 0 => return Err(ParseError::EmptyRequest),
            n if n < 0 => return Err(ParseError::InvalidArrayLength(n)),
            n if n as u64 > self.max_array_len as u64 => {
                return Err(ParseError::InvalidArrayLength(n))
            }
            _ => {}
        }

        let count = count as usize;
        let mut parts = Vec::with_capacity(count.min(64));

        for _ in 0..count {
            match self.parse_bulk_string(buf, pos)? {
                Some((part, next)) => {
                    parts.push(part);
                    pos = next;
                }
                None => return Ok(None),
            }
        }

        match Request::from_parts(parts) {
            Some(request) => Ok(Some((request, pos))),
            None => Err(ParseError::EmptyRequest),
        }
    }

    /// Parses `$<length>\r\n<data>\r\n` starting at `pos`.
    ///
    /// Returns the string and the position just past its trailing CRLF.
    fn parse_bulk_string(&self, buf: &[u8], pos: usize) -> ParseResult<Option<(String, usize)>> {
        if pos >= buf.len() {
            return Ok(None);
        }
        if buf[pos] != prefix::BULK_STRING {
            return Err(ParseError::ExpectedBulkString(buf[pos]));
        }

        let (length, data_start) = match read_header(buf, pos)? {
            Some(header) => header,
            None => return Ok(None),
        };

        if length == -1 {
            return Err(ParseError::ProtocolError(
                "nil bulk string in request".to_string(),
            ));
        }
        if length < 0 {
            return Err(ParseError::InvalidBulkLength(length));
        }

        let length = length as usize;
        if length > self.max_bulk_size {
            return Err(ParseError::MessageTooLarge {
                size: length,
                max: self.max_bulk_size,
            });
        }

        let data_end = data_start + length;
        if buf.len() < data_end + CRLF.len() {
            return Ok(None);
        }

        if &buf[data_end..data_end + CRLF.len()] != CRLF {
            return Err(ParseError::ProtocolError(
                "bulk string missing trailing CRLF".to_string(),
            ));
        }

        let text = std::str::from_utf8(&buf[data_start..data_end])
            .map_err(|e| ParseError::InvalidUtf8(e.to_string()))?;

        Ok(Some((text.to_string(), data_end + CRLF.len())))
    }
}

/// Reads a `<prefix><integer>\r\n` header line starting at `pos`.
///
/// Returns the integer and the position just past the CRLF.
fn read_header(buf: &[u8], pos: usize) -> ParseResult<Option<(i64, usize)>> {
    let line = &buf[pos + 1..];
    let end = match find_crlf(line) {
        Some(end) => end,
        None if line.len() > MAX_HEADER_LEN => {
            return Err(ParseError::ProtocolError(
                "header line too long".to_string(),
            ))
        }
        None => return Ok(None),
    };

    let digits = std::str::from_utf8(&line[..end])
        .map_err(|e| ParseError::InvalidUtf8(e.to_string()))?;
    let value: i64 = digits
        .parse()
        .map_err(|_| ParseError::InvalidInteger(digits.to_string()))?;

    Ok(Some((value, pos + 1 + end + CRLF.len())))
}

/// Finds the position of CRLF in the buffer.
///
/// Returns the position of `\r` if found, or None if CRLF is not present.
#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == CRLF)
}

/// Parses a single request with a default parser.
pub fn parse_request(buf: &[u8]) -> ParseResult<Option<(Request, usize)>> {
    RespParser::new().parse(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ping() {
        let (req, consumed) = parse_request(b"*1\r\n$4\r\nPING\r\n").unwrap().unwrap();
        assert_eq!(req.command, "PING");
        assert!(req.args.is_empty());
        assert_eq!(consumed, 14);
    }

    #[test]
    fn test_parse_set_command() {
        let input = b"*3\r\n$3\r\nset\r\n$8\r\nuser:101\r\n$4\r\nAriz\r\n";
        let (req, consumed) = parse_request(input).unwrap().unwrap();
        assert_eq!(req, Request::new("SET", ["user:101", "Ariz"]));
        assert_eq!(consumed, input.len());
    }

    #[test]
    fn test_value_may_contain_spaces_and_crlf() {
        let input = b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$7\r\na b\r\ncd\r\n";
        let (req, _) = parse_request(input).unwrap().unwrap();
        assert_eq!(req.args[1], "a b\r\ncd");
    }

    #[test]
    fn test_empty_bulk_argument() {
        let (req, _) = parse_request(b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$0\r\n\r\n")
            .unwrap()
            .unwrap();
        assert_eq!(req.args[1], "");
    }

    #[test]
    fn test_incomplete_requests() {
        let full = Request::new("RPUSH", ["page", "<p>", "hello"]).encode();
        for cut in 0..full.len() {
            assert!(
                parse_request(&full[..cut]).unwrap().is_none(),
                "prefix of {} bytes should be incomplete",
                cut
            );
        }
        assert!(parse_request(&full).unwrap().is_some());
    }

    #[test]
    fn test_pipelined_requests() {
        let mut buf = Request::new("INCR", ["n"]).encode();
        buf.extend_from_slice(&Request::new("GET", ["n"]).encode());

        let mut parser = RespParser::new();
        let (first, consumed) = parser.parse(&buf).unwrap().unwrap();
        assert_eq!(first.command, "INCR");

        let (second, rest) = parser.parse(&buf[consumed..]).unwrap().unwrap();
        assert_eq!(second.command, "GET");
        assert_eq!(consumed + rest, buf.len());
    }

    #[test]
    fn test_rejects_non_array() {
        assert_eq!(
            parse_request(b"PING\r\n"),
            Err(ParseError::ExpectedArray(b'P'))
        );
        assert_eq!(
            parse_request(b"+OK\r\n"),
            Err(ParseError::ExpectedArray(b'+'))
        );
    }

    #[test]
    fn test_rejects_non_bulk_element() {
        assert_eq!(
            parse_request(b"*2\r\n$3\r\nGET\r\n:1\r\n"),
            Err(ParseError::ExpectedBulkString(b':'))
        );
    }

    #[test]
    fn test_rejects_empty_and_nil_arrays() {
        assert_eq!(parse_request(b"*0\r\n"), Err(ParseError::EmptyRequest));
        assert_eq!(parse_request(b"*-1\r\n"), Err(ParseError::EmptyRequest));
        assert_eq!(
            parse_request(b"*-3\r\n"),
            Err(ParseError::InvalidArrayLength(-3))
        );
    }

    #[test]
    fn test_rejects_bad_lengths() {
        assert!(matches!(
            parse_request(b"*x\r\n"),
            Err(ParseError::InvalidInteger(_))
        ));
        assert_eq!(
            parse_request(b"*1\r\n$-5\r\n"),
            Err(ParseError::InvalidBulkLength(-5))
        );
        assert!(matches!(
            parse_request(b"*1\r\n$-1\r\n"),
            Err(ParseError::ProtocolError(_))
        ));
    }

    #[test]
    fn test_rejects_missing_trailing_crlf() {
        assert!(matches!(
            parse_request(b"*1\r\n$4\r\nPINGxx"),
            Err(ParseError::ProtocolError(_))
        ));
    }

    #[test]
    fn test_rejects_overlong_header() {
        let mut input = b"*".to_vec();
        input.extend(std::iter::repeat(b'1').take(40));
        assert!(matches!(
            parse_request(&input),
            Err(ParseError::ProtocolError(_))
        ));
    }

    #[test]
    fn test_rejects_invalid_utf8() {
        assert!(matches!(
            parse_request(b"*1\r\n$2\r\n\xff\xfe\r\n"),
            Err(ParseError::InvalidUtf8(_))
        ));
    }

    #[test]
    fn test_bulk_size_limit() {
        let mut parser = RespParser::new().with_max_bulk_size(4);
        assert_eq!(
            parser.parse(b"*1\r\n$5\r\nhello\r\n"),
            Err(ParseError::MessageTooLarge { size: 5, max: 4 })
        );
    }
}
