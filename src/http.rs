// SPDX-License-Identifier: MIT

//! Just enough HTTP/1.1 for a single request/response exchange.
//!
//! The client always sends `connection: close`, so a response is delimited by
//! EOF and can be read in full before parsing. Bodies framed with
//! `content-length` or `transfer-encoding: chunked` are handled as well.

use bytes::BytesMut;
use http::Uri;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::HttpError;

const MAX_HEADERS: usize = 128;
const MAX_HEAD_SIZE: usize = 16 * 1024;

/// A fully-read HTTP response.
#[derive(Debug)]
pub(crate) struct Response {
    pub status: u16,
    /// Header pairs in wire order. Names are not normalized.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// The request line of an incoming request. The demos never read bodies.
#[derive(Debug)]
pub(crate) struct Request {
    pub method: String,
    /// The request target as sent, query string included.
    pub path: String,
}

/// Serialize a GET request for the given URL.
pub(crate) fn format_get_request(uri: &Uri) -> Vec<u8> {
    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let host = match (uri.host(), uri.port_u16()) {
        (Some(host), Some(port)) if port != 443 => format!("{host}:{port}"),
        (Some(host), _) => host.to_string(),
        (None, _) => String::new(),
    };
    format!(
        "GET {path} HTTP/1.1\r\n\
         host: {host}\r\n\
         user-agent: httpsdemo/{version}\r\n\
         accept: */*\r\n\
         connection: close\r\n\
         \r\n",
        version = env!("CARGO_PKG_VERSION"),
    )
    .into_bytes()
}

/// Read a response to EOF and parse it.
pub(crate) async fn read_response<S>(stream: &mut S) -> Result<Response, HttpError>
where
    S: AsyncRead + Unpin,
{
    let mut raw = Vec::with_capacity(8 * 1024);
    stream.read_to_end(&mut raw).await?;

    let (status, headers, head_len) = {
        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
        let mut parser = httparse::Response::new(&mut headers);
        let head_len = match parser.parse(&raw)? {
            httparse::Status::Complete(len) => len,
            httparse::Status::Partial => return Err(HttpError::Incomplete),
        };
        let status = parser.code.ok_or(HttpError::Incomplete)?;
        let headers = parser
            .headers
            .iter()
            .map(|header| {
                (
                    header.name.to_string(),
                    String::from_utf8_lossy(header.value).into_owned(),
                )
            })
            .collect::<Vec<_>>();
        (status, headers, head_len)
    };

    let mut body = raw.split_off(head_len);
    if header_value(&headers, "transfer-encoding")
        .is_some_and(|value| value.to_ascii_lowercase().contains("chunked"))
    {
        body = decode_chunked(&body)?;
    } else if let Some(length) = header_value(&headers, "content-length") {
        let length: usize = length
            .trim()
            .parse()
            .map_err(|_| HttpError::InvalidHeader("content-length"))?;
        if body.len() < length {
            return Err(HttpError::Incomplete);
        }
        body.truncate(length);
    }

    Ok(Response {
        status,
        headers,
        body,
    })
}

/// Read an incoming request head. Any body is left unread on the stream.
pub(crate) async fn read_request<S>(stream: &mut S) -> Result<Request, HttpError>
where
    S: AsyncRead + Unpin,
{
    let mut buffer = BytesMut::with_capacity(1024);
    loop {
        {
            let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
            let mut parser = httparse::Request::new(&mut headers);
            if let httparse::Status::Complete(_) = parser.parse(&buffer)? {
                let method = parser.method.ok_or(HttpError::Incomplete)?.to_string();
                let path = parser.path.ok_or(HttpError::Incomplete)?.to_string();
                return Ok(Request { method, path });
            }
        }
        if buffer.len() > MAX_HEAD_SIZE {
            return Err(HttpError::HeadTooLarge);
        }
        if stream.read_buf(&mut buffer).await? == 0 {
            return Err(HttpError::Incomplete);
        }
    }
}

/// Write a response with the given body, framed with `content-length`.
pub(crate) async fn write_response<S>(
    stream: &mut S,
    status: u16,
    reason: &str,
    extra_headers: &[(&str, &str)],
    body: &[u8],
) -> Result<(), HttpError>
where
    S: AsyncWrite + Unpin,
{
    let mut head = format!("HTTP/1.1 {status} {reason}\r\n");
    for (name, value) in extra_headers {
        head.push_str(&format!("{name}: {value}\r\n"));
    }
    head.push_str(&format!(
        "content-length: {}\r\nconnection: close\r\n\r\n",
        body.len()
    ));
    stream.write_all(head.as_bytes()).await?;
    stream.write_all(body).await?;
    stream.flush().await?;
    Ok(())
}

fn header_value<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(header, _)| header.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

fn decode_chunked(mut data: &[u8]) -> Result<Vec<u8>, HttpError> {
    let mut body = Vec::with_capacity(data.len());
    loop {
        let (consumed, size) = match httparse::parse_chunk_size(data) {
            Ok(httparse::Status::Complete(parsed)) => parsed,
            Ok(httparse::Status::Partial) => return Err(HttpError::Incomplete),
            Err(_invalid) => return Err(HttpError::InvalidChunk),
        };
        data = &data[consumed..];
        let size: usize = size.try_into().map_err(|_| HttpError::InvalidChunk)?;
        if size == 0 {
            break;
        }
        // Each chunk is followed by CRLF; a size this close to usize::MAX
        // is never honest, so treat the overflow as a malformed chunk.
        let chunk_end = size.checked_add(2).ok_or(HttpError::InvalidChunk)?;
        if data.len() < chunk_end {
            return Err(HttpError::Incomplete);
        }
        body.extend_from_slice(&data[..size]);
        data = &data[chunk_end..];
    }
    Ok(body)
}
