//! Server side of the WebSocket opening handshake (RFC 6455 Section 4.2).
//!
//! The accept value proves the server read the client's key. Request parsing
//! is provided for collaborators that receive the upgrade on a raw stream.

use crate::error::{Error, Result};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use sha1::{Digest, Sha1};
use std::collections::HashMap;

/// The WebSocket GUID used in the Sec-WebSocket-Accept calculation (RFC 6455).
pub const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Computes the Sec-WebSocket-Accept value from the client's Sec-WebSocket-Key.
///
/// The accept key is calculated as: Base64(SHA-1(key + GUID))
///
/// # Example
///
/// ```
/// use wsframe::protocol::handshake::compute_accept_key;
///
/// let key = "dGhlIHNhbXBsZSBub25jZQ==";
/// let accept = compute_accept_key(key);
/// assert_eq!(accept, "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
/// ```
pub fn compute_accept_key(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    let hash = hasher.finalize();
    BASE64.encode(hash)
}

/// Parse header lines into a map keyed by lowercase name.
///
/// Security-critical headers may not appear twice.
fn parse_headers<'a, I>(lines: I) -> Result<HashMap<String, String>>
where
    I: Iterator<Item = &'a str>,
{
    const SINGLE: [&str; 5] = [
        "host",
        "upgrade",
        "connection",
        "sec-websocket-key",
        "sec-websocket-version",
    ];

    let mut headers: HashMap<String, String> = HashMap::new();

    for line in lines {
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            let name_lower = name.trim().to_lowercase();

            if SINGLE.contains(&name_lower.as_str()) && headers.contains_key(&name_lower) {
                return Err(Error::InvalidHandshake(format!(
                    "Duplicate header: {}",
                    name.trim()
                )));
            }

            headers.insert(name_lower, value.trim().to_string());
        }
    }

    Ok(headers)
}

/// Parsed WebSocket upgrade request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeRequest {
    /// The request path (e.g., "/ws").
    pub path: String,
    /// The Host header value.
    pub host: String,
    /// The Sec-WebSocket-Key header value.
    pub key: String,
    /// The Sec-WebSocket-Version (should be 13).
    pub version: u8,
    /// The Origin header value (optional).
    pub origin: Option<String>,
}

impl HandshakeRequest {
    /// Parse a WebSocket upgrade request from a raw HTTP request head.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHandshake`] if:
    /// - The data is not valid UTF-8.
    /// - The request line is malformed, not `GET`, or not `HTTP/1.1`.
    /// - `Upgrade`, `Connection`, `Host`, `Sec-WebSocket-Key` or
    ///   `Sec-WebSocket-Version` is missing or malformed.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(data)
            .map_err(|_| Error::InvalidHandshake("Invalid UTF-8".into()))?;

        let mut lines = text.lines();

        // Request line: "GET /path HTTP/1.1"
        let request_line = lines
            .next()
            .ok_or_else(|| Error::InvalidHandshake("Empty request".into()))?;

        let parts: Vec<&str> = request_line.split_whitespace().collect();
        if parts.len() != 3 {
            return Err(Error::InvalidHandshake("Invalid request line".into()));
        }

        if parts[0] != "GET" {
            return Err(Error::InvalidHandshake(format!(
                "Expected GET method, got {}",
                parts[0]
            )));
        }

        if !parts[2].starts_with("HTTP/1.1") {
            return Err(Error::InvalidHandshake(format!(
                "Expected HTTP/1.1, got {}",
                parts[2]
            )));
        }

        let path = parts[1].to_string();
        let headers = parse_headers(lines)?;

        let upgrade = headers
            .get("upgrade")
            .ok_or_else(|| Error::InvalidHandshake("Missing Upgrade header".into()))?;
        if !upgrade.eq_ignore_ascii_case("websocket") {
            return Err(Error::InvalidHandshake(format!(
                "Invalid Upgrade header: {}",
                upgrade
            )));
        }

        let connection = headers
            .get("connection")
            .ok_or_else(|| Error::InvalidHandshake("Missing Connection header".into()))?;
        if !connection.to_lowercase().contains("upgrade") {
            return Err(Error::InvalidHandshake(format!(
                "Invalid Connection header: {}",
                connection
            )));
        }

        let host = headers
            .get("host")
            .ok_or_else(|| Error::InvalidHandshake("Missing Host header".into()))?
            .clone();

        let key = headers
            .get("sec-websocket-key")
            .ok_or_else(|| Error::InvalidHandshake("Missing Sec-WebSocket-Key header".into()))?
            .clone();

        let version_str = headers.get("sec-websocket-version").ok_or_else(|| {
            Error::InvalidHandshake("Missing Sec-WebSocket-Version header".into())
        })?;
        let version: u8 = version_str
            .parse()
            .map_err(|_| Error::InvalidHandshake(format!("Invalid version: {}", version_str)))?;

        Ok(Self {
            path,
            host,
            key,
            version,
            origin: headers.get("origin").cloned(),
        })
    }

    /// Parse a request head with a size limit.
    ///
    /// # Errors
    ///
    /// - `Error::HandshakeTooLarge` if data exceeds `max_size`
    /// - Other handshake errors as per `parse()`
    pub fn parse_with_limit(data: &[u8], max_size: usize) -> Result<Self> {
        if data.len() > max_size {
            return Err(Error::HandshakeTooLarge {
                size: data.len(),
                max: max_size,
            });
        }
        Self::parse(data)
    }

    /// Validate the request according to RFC 6455.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHandshake`] if the version is not 13, the key
    /// is not base64 for 16 bytes, or the host is empty.
    pub fn validate(&self) -> Result<()> {
        if self.version != 13 {
            return Err(Error::InvalidHandshake(format!(
                "Unsupported WebSocket version: {} (expected 13)",
                self.version
            )));
        }

        match BASE64.decode(&self.key) {
            Ok(decoded) if decoded.len() == 16 => {}
            Ok(decoded) => {
                return Err(Error::InvalidHandshake(format!(
                    "Sec-WebSocket-Key must be 16 bytes, got {}",
                    decoded.len()
                )));
            }
            Err(_) => {
                return Err(Error::InvalidHandshake(
                    "Invalid Sec-WebSocket-Key: not valid Base64".into(),
                ));
            }
        }

        if self.host.is_empty() {
            return Err(Error::InvalidHandshake(
                "Host header cannot be empty".into(),
            ));
        }

        Ok(())
    }
}

/// The 101 response completing the upgrade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeResponse {
    /// The Sec-WebSocket-Accept value.
    pub accept: String,
    /// The `Server` header value.
    pub server: String,
}

impl HandshakeResponse {
    /// Build a response for the given client key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHandshake`] if the key is empty or either value
    /// would break the header block (contains CR or LF).
    pub fn for_key(key: &str, server: &str) -> Result<Self> {
        let key = key.trim();
        if key.is_empty() {
            return Err(Error::InvalidHandshake(
                "Missing Sec-WebSocket-Key".into(),
            ));
        }
        if key.contains(['\r', '\n']) || server.contains(['\r', '\n']) {
            return Err(Error::InvalidHandshake(
                "Header value contains CR or LF".into(),
            ));
        }
        Ok(Self {
            accept: compute_accept_key(key),
            server: server.to_string(),
        })
    }

    /// Write the HTTP response to a buffer.
    pub fn write(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(b"HTTP/1.1 101 Web Socket Protocol Handshake\r\n");
        buf.extend_from_slice(format!("Server: {}\r\n", self.server).as_bytes());
        buf.extend_from_slice(b"Upgrade: WebSocket\r\n");
        buf.extend_from_slice(b"Connection: Upgrade\r\n");
        buf.extend_from_slice(format!("Sec-WebSocket-Accept: {}\r\n", self.accept).as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    /// Serialize the response into a new buffer.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(160);
        self.write(&mut buf);
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_REQUEST: &[u8] = b"GET /ws HTTP/1.1\r\n\
        Host: example.com\r\n\
        Upgrade: websocket\r\n\
        Connection: keep-alive, Upgrade\r\n\
        Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
        Sec-WebSocket-Version: 13\r\n\
        Origin: http://example.com\r\n\
        \r\n";

    #[test]
    fn test_accept_key_rfc_vector() {
        assert_eq!(
            compute_accept_key("dGhlIHNhbXBsZSBub25jZQ=="),
            "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
        );
    }

    #[test]
    fn test_response_bytes() {
        let response = HandshakeResponse::for_key("dGhlIHNhbXBsZSBub25jZQ==", "wsframe").unwrap();
        let expected = "HTTP/1.1 101 Web Socket Protocol Handshake\r\n\
            Server: wsframe\r\n\
            Upgrade: WebSocket\r\n\
            Connection: Upgrade\r\n\
            Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n\
            \r\n";
        assert_eq!(String::from_utf8(response.to_bytes()).unwrap(), expected);
    }

    #[test]
    fn test_response_rejects_empty_key() {
        assert!(matches!(
            HandshakeResponse::for_key("  ", "wsframe"),
            Err(Error::InvalidHandshake(_))
        ));
    }

    #[test]
    fn test_response_rejects_header_injection() {
        assert!(HandshakeResponse::for_key("abc\r\nX-Evil: 1", "wsframe").is_err());
        assert!(HandshakeResponse::for_key("abc", "name\r\n").is_err());
    }

    #[test]
    fn test_parse_request() {
        let req = HandshakeRequest::parse(SAMPLE_REQUEST).unwrap();
        assert_eq!(req.path, "/ws");
        assert_eq!(req.host, "example.com");
        assert_eq!(req.key, "dGhlIHNhbXBsZSBub25jZQ==");
        assert_eq!(req.version, 13);
        assert_eq!(req.origin.as_deref(), Some("http://example.com"));
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_parse_rejects_post() {
        let data = b"POST /ws HTTP/1.1\r\nHost: a\r\n\r\n";
        assert!(matches!(
            HandshakeRequest::parse(data),
            Err(Error::InvalidHandshake(_))
        ));
    }

    #[test]
    fn test_parse_missing_key() {
        let data = b"GET / HTTP/1.1\r\n\
            Host: a\r\n\
            Upgrade: websocket\r\n\
            Connection: Upgrade\r\n\
            Sec-WebSocket-Version: 13\r\n\r\n";
        let err = HandshakeRequest::parse(data).unwrap_err();
        assert_eq!(
            err,
            Error::InvalidHandshake("Missing Sec-WebSocket-Key header".into())
        );
    }

    #[test]
    fn test_parse_duplicate_key() {
        let data = b"GET / HTTP/1.1\r\n\
            Host: a\r\n\
            Upgrade: websocket\r\n\
            Connection: Upgrade\r\n\
            Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
            Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
            Sec-WebSocket-Version: 13\r\n\r\n";
        assert!(HandshakeRequest::parse(data).is_err());
    }

    #[test]
    fn test_parse_with_limit() {
        assert!(matches!(
            HandshakeRequest::parse_with_limit(SAMPLE_REQUEST, 16),
            Err(Error::HandshakeTooLarge { max: 16, .. })
        ));
    }

    #[test]
    fn test_validate_version_and_key() {
        let mut req = HandshakeRequest::parse(SAMPLE_REQUEST).unwrap();
        req.version = 8;
        assert!(req.validate().is_err());

        let mut req = HandshakeRequest::parse(SAMPLE_REQUEST).unwrap();
        req.key = "c2hvcnQ=".into();
        assert!(req.validate().is_err());
    }
}
