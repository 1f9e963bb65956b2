//! Minimal HTTP/1.1 client for no_std environments
//!
//! One GET per connection (`Connection: close`). The whole response is read
//! into a caller-provided buffer and the body is left at its start, with
//! chunked transfer encoding already removed.

use core::fmt::Write as FmtWrite;
use core::str;

use embedded_io_async::{Read, Write};
use heapless::String;
use log::debug;

/// HTTP client error types
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HttpError {
    #[error("could not reach server")]
    Connect,
    #[error("write failed")]
    Write,
    #[error("read failed")]
    Read,
    #[error("invalid URL")]
    InvalidUrl,
    #[error("malformed response")]
    Parse,
    #[error("HTTP {0}")]
    Status(u16),
    #[error("response too large")]
    TooLarge,
}

/// Parsed `http://` URL components
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Url<'a> {
    pub host: &'a str,
    pub port: u16,
    pub path: &'a str,
}

impl<'a> Url<'a> {
    /// Parse `http://host[:port][/path]`
    pub fn parse(url: &'a str) -> Result<Self, HttpError> {
        let rest = url.strip_prefix("http://").ok_or(HttpError::InvalidUrl)?;

        let (host_port, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, "/"),
        };

        let (host, port) = match host_port.split_once(':') {
            Some((host, port)) => (host, port.parse().map_err(|_| HttpError::InvalidUrl)?),
            None => (host_port, 80),
        };

        if host.is_empty() {
            return Err(HttpError::InvalidUrl);
        }

        Ok(Url { host, port, path })
    }
}

/// Response framing taken from the headers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Framing {
    body_start: usize,
    content_length: Option<usize>,
    chunked: bool,
}

impl Framing {
    fn from_headers(buf: &[u8], headers_end: usize) -> Result<(u16, Self), HttpError> {
        let header_str = str::from_utf8(&buf[..headers_end]).map_err(|_| HttpError::Parse)?;
        let status = parse_status(header_str)?;
        let content_length = parse_header(header_str, "content-length").and_then(|v| v.parse().ok());
        let chunked = parse_header(header_str, "transfer-encoding")
            .is_some_and(|v| v.eq_ignore_ascii_case("chunked"));

        Ok((
            status,
            Self {
                body_start: headers_end + 4,
                content_length,
                chunked,
            },
        ))
    }

    fn complete(&self, total: usize) -> bool {
        self.content_length
            .is_some_and(|len| total >= self.body_start.saturating_add(len))
    }
}

/// Perform an HTTP GET and read the full response into `buf`.
///
/// On success the decoded body occupies `buf[..n]` and `n` is returned.
/// Status codes of 400 and above are errors; nothing of the body is kept.
pub async fn get<S>(stream: &mut S, url: &Url<'_>, buf: &mut [u8]) -> Result<usize, HttpError>
where
    S: Read + Write,
{
    let mut request: String<256> = String::new();
    write!(&mut request, "GET {} HTTP/1.1\r\nHost: {}", url.path, url.host)
        .map_err(|_| HttpError::TooLarge)?;
    if url.port != 80 {
        write!(&mut request, ":{}", url.port).map_err(|_| HttpError::TooLarge)?;
    }
    request
        .push_str("\r\nAccept: application/json\r\nConnection: close\r\n\r\n")
        .map_err(|_| HttpError::TooLarge)?;

    stream
        .write_all(request.as_bytes())
        .await
        .map_err(|_| HttpError::Write)?;
    stream.flush().await.map_err(|_| HttpError::Write)?;

    let mut total = 0;
    let mut head: Option<(u16, Framing)> = None;

    loop {
        if let Some((_, framing)) = &head {
            if framing.complete(total) {
                break;
            }
        }
        if total >= buf.len() {
            return Err(HttpError::TooLarge);
        }

        let n = stream
            .read(&mut buf[total..])
            .await
            .map_err(|_| HttpError::Read)?;
        if n == 0 {
            break;
        }
        total += n;

        if head.is_none() {
            if let Some(end) = find_header_end(&buf[..total]) {
                let parsed = Framing::from_headers(buf, end)?;
                if parsed.0 >= 400 {
                    return Err(HttpError::Status(parsed.0));
                }
                head = Some(parsed);
            }
        }
    }

    let (status, framing) = head.ok_or(HttpError::Parse)?;
    debug!("HTTP {} ({} bytes)", status, total);

    let mut body_end = total;
    if let Some(len) = framing.content_length {
        body_end = framing
            .body_start
            .checked_add(len)
            .filter(|e| *e <= total)
            .ok_or(HttpError::Read)?;
    }

    if framing.chunked {
        return decode_chunked(buf, framing.body_start, body_end);
    }

    buf.copy_within(framing.body_start..body_end, 0);
    Ok(body_end - framing.body_start)
}

/// Strip chunked framing from `buf[start..end]`, moving the payload to the
/// front of `buf`. Returns the payload length.
pub fn decode_chunked(buf: &mut [u8], start: usize, end: usize) -> Result<usize, HttpError> {
    let mut read = start;
    let mut written = 0;

    loop {
        if read >= end {
            return Err(HttpError::Read);
        }
        let line_len = buf[read..end]
            .windows(2)
            .position(|w| w == b"\r\n")
            .ok_or(HttpError::Parse)?;
        let line = str::from_utf8(&buf[read..read + line_len]).map_err(|_| HttpError::Parse)?;
        // Chunk extensions after ';' are ignored
        let size_str = line.split(';').next().unwrap_or("").trim();
        let size = usize::from_str_radix(size_str, 16).map_err(|_| HttpError::Parse)?;
        read += line_len + 2;

        if size == 0 {
            return Ok(written);
        }
        // Sizes come off the wire; the trailing CRLF must fit too
        let chunk_end = read
            .checked_add(size)
            .filter(|e| *e <= end)
            .ok_or(HttpError::Read)?;
        let next = chunk_end
            .checked_add(2)
            .filter(|e| *e <= end)
            .ok_or(HttpError::Read)?;

        buf.copy_within(read..chunk_end, written);
        written += size;
        read = next;
    }
}

/// Find the position of \r\n\r\n in the buffer
pub fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Parse HTTP status code from status line
pub fn parse_status(headers: &str) -> Result<u16, HttpError> {
    // HTTP/1.1 200 OK
    let line = headers.lines().next().ok_or(HttpError::Parse)?;
    let mut parts = line.splitn(3, ' ');
    let version = parts.next().ok_or(HttpError::Parse)?;
    if !version.starts_with("HTTP/") {
        return Err(HttpError::Parse);
    }
    parts
        .next()
        .ok_or(HttpError::Parse)?
        .parse()
        .map_err(|_| HttpError::Parse)
}

/// Parse a header value (case-insensitive)
pub fn parse_header<'a>(headers: &'a str, name: &str) -> Option<&'a str> {
    headers.lines().skip(1).find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim().eq_ignore_ascii_case(name).then(|| value.trim())
    })
}

/// Parse a dotted-quad host without DNS
pub fn parse_ipv4(host: &str) -> Result<core::net::Ipv4Addr, HttpError> {
    host.parse().map_err(|_| HttpError::InvalidUrl)
}
