//! Parsing of the relay's single positional argument
//!
//! The calling shell script passes exactly one request: `getport` for an
//! ephemeral tunnel port, or `{boardclass}:{port}` to acquire a board.

use std::str::FromStr;

use thiserror::Error;

/// A parsed client request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Allocate the next ephemeral tunnel port
    GetPort,
    /// Acquire a board of `board_class`; the caller will forward the
    /// user's connection over `tunnel_port`
    Tunnel {
        board_class: String,
        tunnel_port: u16,
    },
}

/// The request matched neither accepted form
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Argument should be of the form boardclass:port")]
pub struct MalformedRequest;

impl FromStr for Request {
    type Err = MalformedRequest;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if raw == "getport" {
            return Ok(Request::GetPort);
        }
        let (board_class, port_raw) = raw.split_once(':').ok_or(MalformedRequest)?;
        let tunnel_port = port_raw.parse().map_err(|_| MalformedRequest)?;
        Ok(Request::Tunnel {
            board_class: board_class.to_string(),
            tunnel_port,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_getport() {
        assert_eq!("getport".parse(), Ok(Request::GetPort));
    }

    #[test]
    fn parses_class_and_port() {
        assert_eq!(
            "zynq:12345".parse(),
            Ok(Request::Tunnel {
                board_class: "zynq".to_string(),
                tunnel_port: 12345,
            })
        );
    }

    #[test]
    fn rejects_missing_separator() {
        assert_eq!("zynq".parse::<Request>(), Err(MalformedRequest));
    }

    #[test]
    fn rejects_non_numeric_port() {
        assert_eq!("zynq:screen".parse::<Request>(), Err(MalformedRequest));
        assert_eq!("zynq:".parse::<Request>(), Err(MalformedRequest));
    }

    #[test]
    fn rejects_out_of_range_port() {
        assert_eq!("zynq:70000".parse::<Request>(), Err(MalformedRequest));
    }
}
