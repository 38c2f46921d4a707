//! HTTP/1.1 request parsing using the [`httparse`] crate.

use bytes::Bytes;
use thiserror::Error;

use super::{Headers, Method};

/// Errors that can occur while parsing an HTTP/1.1 request.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request is incomplete, more data needed")]
    Incomplete,

    #[error("HTTP parse error: {0}")]
    Parse(#[from] httparse::Error),

    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid Content-Length header")]
    InvalidContentLength,
}

/// A parsed HTTP/1.1 request.
///
/// # Examples
///
/// ```
/// use proephem::http::request::Request;
///
/// let raw = b"POST /getProEphemeris HTTP/1.1\r\nAuthorization: Bearer t0k\r\nContent-Length: 2\r\n\r\n{}";
/// let (request, _offset) = Request::parse(raw).unwrap();
///
/// assert_eq!(request.path(), "/getProEphemeris");
/// assert_eq!(request.bearer_token(), Some("t0k"));
/// assert_eq!(&request.body()[..], b"{}");
/// ```
#[derive(Debug)]
pub struct Request {
    method: Method,
    path: String,
    /// HTTP minor version: 0 for HTTP/1.0, 1 for HTTP/1.1.
    version: u8,
    headers: Headers,
    body: Bytes,
}

impl Request {
    /// Maximum number of headers we support per request.
    const MAX_HEADERS: usize = 64;

    /// Parses a request from the start of `buf`.
    ///
    /// Returns the request and the offset at which its body begins. The body
    /// holds at most `Content-Length` bytes; it may be shorter when `buf` does
    /// not contain the whole body yet, so callers compare
    /// [`content_length`](Self::content_length) against what they have
    /// buffered.
    ///
    /// # Errors
    ///
    /// - [`RequestError::Incomplete`]: the header block is not complete yet.
    /// - [`RequestError::Parse`]: the data is malformed.
    /// - [`RequestError::MissingField`]: method, path or version is absent.
    /// - [`RequestError::InvalidContentLength`]: `Content-Length` is not a
    ///   number or does not fit in memory.
    pub fn parse(buf: &[u8]) -> Result<(Self, usize), RequestError> {
        let mut headers = [httparse::EMPTY_HEADER; Self::MAX_HEADERS];
        let mut raw_req = httparse::Request::new(&mut headers);

        let body_offset = match raw_req.parse(buf)? {
            httparse::Status::Complete(offset) => offset,
            httparse::Status::Partial => return Err(RequestError::Incomplete),
        };

        let method = Method::from(
            raw_req
                .method
                .ok_or(RequestError::MissingField { field: "method" })?,
        );

        let raw_path = raw_req
            .path
            .ok_or(RequestError::MissingField { field: "path" })?;
        // The query string carries nothing for this service.
        let path = raw_path
            .split_once('?')
            .map_or(raw_path, |(path, _)| path)
            .to_owned();

        let version = raw_req
            .version
            .ok_or(RequestError::MissingField { field: "version" })?;

        let mut header_map = Headers::with_capacity(raw_req.headers.len());
        for header in raw_req.headers.iter() {
            if let Ok(value) = std::str::from_utf8(header.value) {
                header_map.insert(header.name, value);
            }
        }

        let content_length = match header_map.get("content-length") {
            Some(value) => value
                .trim()
                .parse::<usize>()
                .map_err(|_| RequestError::InvalidContentLength)?,
            None => 0,
        };
        let body_end = body_offset
            .checked_add(content_length)
            .ok_or(RequestError::InvalidContentLength)?;
        let body = Bytes::copy_from_slice(&buf[body_offset..buf.len().min(body_end)]);

        Ok((
            Self {
                method,
                path,
                version,
                headers: header_map,
                body,
            },
            body_offset,
        ))
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request path (without the query string).
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the token of an `Authorization: Bearer <token>` header.
    ///
    /// The scheme is matched case-insensitively; an empty token counts as absent.
    pub fn bearer_token(&self) -> Option<&str> {
        let value = self.headers.get("authorization")?.trim();
        let (scheme, token) = value.split_once(' ')?;
        let token = token.trim();
        (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
    }

    /// Returns `true` if the connection should be kept alive after this request.
    ///
    /// HTTP/1.1 defaults to keep-alive. HTTP/1.0 defaults to close unless
    /// `Connection: keep-alive` is explicitly set.
    pub fn is_keep_alive(&self) -> bool {
        match self.headers.get("connection") {
            Some(conn) => conn.eq_ignore_ascii_case("keep-alive"),
            None => self.version == 1,
        }
    }

    /// Returns the declared `Content-Length`, if present.
    pub fn content_length(&self) -> Option<usize> {
        self.headers.get("content-length")?.trim().parse().ok()
    }
}
