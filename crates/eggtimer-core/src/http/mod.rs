//! HTTP request parsing, routing and response framing.
//!
//! Enough of HTTP/1.1 for one browser talking to one socket: a request
//! line, a handful of headers, an optional small form body, and a framed
//! response that forbids caching and closes the connection.

use core::fmt;

#[cfg(test)]
mod tests;

/// Byte index just past the `\r\n\r\n` head terminator, if present.
pub fn head_end(raw: &[u8]) -> Option<usize> {
    raw.windows(4).position(|w| w == b"\r\n\r\n").map(|i| i + 4)
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Method {
    Get,
    Post,
    Other,
}

impl Method {
    fn from_token(token: &str) -> Self {
        match token {
            "GET" => Method::Get,
            "POST" => Method::Post,
            _ => Method::Other,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RequestError {
    /// Head bytes are not UTF-8.
    BadEncoding,
    /// Request line does not carry exactly three tokens.
    BadRequestLine,
}

/// Parsed request line plus the raw header block.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RequestHead<'a> {
    pub method: Method,
    /// Target with any query string stripped.
    pub path: &'a str,
    headers: &'a str,
}

/// Parses everything up to the head terminator. The request line must be
/// whole (method, target and version); the header block may arrive
/// truncated and is used as-is.
pub fn parse_request_head(raw: &[u8]) -> Result<RequestHead<'_>, RequestError> {
    let text = core::str::from_utf8(raw).map_err(|_| RequestError::BadEncoding)?;
    let request_line = text.lines().next().ok_or(RequestError::BadRequestLine)?;

    let mut parts = request_line.split_whitespace();
    let method = parts.next().ok_or(RequestError::BadRequestLine)?;
    let target = parts.next().ok_or(RequestError::BadRequestLine)?;
    let _version = parts.next().ok_or(RequestError::BadRequestLine)?;
    if parts.next().is_some() {
        return Err(RequestError::BadRequestLine);
    }

    let method = Method::from_token(method);
    let path = match target.split_once('?') {
        Some((path, _query)) => path,
        None => target,
    };

    let headers = match text.split_once("\r\n") {
        Some((_, rest)) => rest,
        None => "",
    };

    Ok(RequestHead {
        method,
        path,
        headers,
    })
}

impl<'a> RequestHead<'a> {
    /// Case-insensitive header lookup, value trimmed.
    pub fn header_value(&self, name: &str) -> Option<&'a str> {
        for line in self.headers.lines() {
            if let Some((key, value)) = line.split_once(':') {
                if key.trim().eq_ignore_ascii_case(name) {
                    return Some(value.trim());
                }
            }
        }
        None
    }

    /// Declared body length, zero when absent or unparsable, capped to
    /// what the request buffer can hold.
    pub fn content_length(&self, cap: usize) -> usize {
        self.header_value("Content-Length")
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or(0)
            .min(cap)
    }
}

/// Looks up `key` in an `application/x-www-form-urlencoded` body.
///
/// Values are taken literally (the page posts plain digits, so no
/// percent-decoding); when a key repeats, the last occurrence wins.
pub fn form_field<'a>(body: &'a [u8], key: &str) -> Option<&'a str> {
    let text = core::str::from_utf8(body).ok()?;
    let mut found = None;
    for pair in text.split('&') {
        if let Some((k, value)) = pair.split_once('=') {
            if k == key {
                found = Some(value);
            }
        }
    }
    found
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Route {
    Index,
    Status,
    Set,
    Stop,
    LedOff,
    NotFound,
}

impl Route {
    pub fn resolve(method: Method, path: &str) -> Route {
        match (method, path) {
            (Method::Get, "/") => Route::Index,
            (Method::Get, "/status") => Route::Status,
            (Method::Post, "/set") => Route::Set,
            (Method::Post, "/stop") => Route::Stop,
            (Method::Post, "/ledoff") => Route::LedOff,
            _ => Route::NotFound,
        }
    }

    /// Only the set route reads a body; everything else ignores one.
    pub fn needs_body(self) -> bool {
        matches!(self, Route::Set)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StatusCode {
    Ok,
    BadRequest,
    NotFound,
    Error,
}

impl StatusCode {
    pub fn code(self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::NotFound => 404,
            StatusCode::Error => 500,
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::Error => "Internal Server Error",
        }
    }
}

/// Writes the full response head: status line, entity headers, the
/// cache-disabling block, `Connection: close`, and the blank line.
pub fn write_response_head<const N: usize>(
    out: &mut heapless::String<N>,
    status: StatusCode,
    content_type: &str,
    content_length: usize,
) -> fmt::Result {
    use core::fmt::Write as _;
    write!(
        out,
        "HTTP/1.1 {} {}\r\n\
         Content-Type: {}\r\n\
         Content-Length: {}\r\n\
         Cache-Control: no-store, no-cache, must-revalidate, max-age=0\r\n\
         Pragma: no-cache\r\n\
         Connection: close\r\n\
         \r\n",
        status.code(),
        status.reason(),
        content_type,
        content_length,
    )
}
