//! A parsed client request.

use crate::protocol::types::{prefix, CRLF};

/// One command sent by a client: an upper-cased name plus its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Command name, always upper case.
    pub command: String,
    /// Arguments in the order they were sent.
    pub args: Vec<String>,
}

impl Request {
    /// Builds a request, normalizing the command name to upper case.
    pub fn new<I, S>(command: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.to_ascii_uppercase(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Splits the elements of a request array into name and arguments.
    ///
    /// Returns `None` for an empty array.
    pub fn from_parts(mut parts: Vec<String>) -> Option<Self> {
        if parts.is_empty() {
            return None;
        }
        let mut command = parts.remove(0);
        command.make_ascii_uppercase();
        Some(Self {
            command,
            args: parts,
        })
    }

    /// Encodes the request as an array of bulk strings, the way a client
    /// sends it.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.push(prefix::ARRAY);
        buf.extend_from_slice((self.args.len() + 1).to_string().as_bytes());
        buf.extend_from_slice(CRLF);
        for part in std::iter::once(&self.command).chain(self.args.iter()) {
            buf.push(prefix::BULK_STRING);
            buf.extend_from_slice(part.len().to_string().as_bytes());
            buf.extend_from_slice(CRLF);
            buf.extend_from_slice(part.as_bytes());
            buf.extend_from_slice(CRLF);
        }
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uppercases_command() {
        let req = Request::new("lpush", ["k", "a"]);
        assert_eq!(req.command, "LPUSH");
        assert_eq!(req.args, vec!["k".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_from_parts() {
        let req = Request::from_parts(vec!["get".into(), "name".into()]).unwrap();
        assert_eq!(req, Request::new("GET", ["name"]));
        assert!(Request::from_parts(Vec::new()).is_none());
    }

    #[test]
    fn test_encode() {
        let req = Request::new("GET", ["name"]);
        assert_eq!(req.encode(), b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n");

        let ping = Request::new("PING", Vec::<String>::new());
        assert_eq!(ping.encode(), b"*1\r\n$4\r\nPING\r\n");
    }
}
