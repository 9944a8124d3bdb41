//! HTTP transport for the game API.
//!
//! The server matches header names case-sensitively (`x-OS`, `x-DL`), so
//! the client writes names exactly as given. `HttpClient` is a small
//! HTTP/1.1 writer and reader over a plain TCP stream, one connection per
//! request. It has no request timeout: a server that never answers blocks
//! the call.

use std::future::Future;

use bytes::Bytes;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, trace};

use crate::common::error::{ApiError, ApiResult};

/// Largest response body accepted.
pub const MAX_BODY_LEN: usize = 16 * 1024 * 1024;

const MAX_HEADER_LINES: usize = 100;

/// Longest status, header or chunk-size line accepted.
const MAX_LINE_LEN: usize = 8 * 1024;

/// Something that can POST a body and return the response body.
///
/// Implementations must send every `(name, value)` pair exactly as given.
pub trait HttpTransport {
    fn post(
        &self,
        path: &str,
        headers: &[(String, String)],
        body: Bytes,
    ) -> impl Future<Output = ApiResult<Bytes>> + Send;
}

/// Minimal HTTP/1.1 client.
#[derive(Debug, Clone)]
pub struct HttpClient {
    host: String,
    port: u16,
}

impl HttpClient {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    fn build_request(
        &self,
        path: &str,
        headers: &[(String, String)],
        body: &[u8],
    ) -> ApiResult<Vec<u8>> {
        let mut head = format!(
            "POST {} HTTP/1.1\r\nHost: {}:{}\r\n",
            path, self.host, self.port
        );
        for (name, value) in headers {
            if has_line_break(name) || has_line_break(value) {
                return Err(ApiError::InvalidHeader { name: name.clone() });
            }
            head.push_str(name);
            head.push_str(": ");
            head.push_str(value);
            head.push_str("\r\n");
        }
        head.push_str("Content-Type: application/x-www-form-urlencoded\r\n");
        head.push_str(&format!("Content-Length: {}\r\n", body.len()));
        head.push_str("Connection: close\r\n\r\n");

        let mut request = head.into_bytes();
        request.extend_from_slice(body);
        Ok(request)
    }
}

impl HttpTransport for HttpClient {
    async fn post(
        &self,
        path: &str,
        headers: &[(String, String)],
        body: Bytes,
    ) -> ApiResult<Bytes> {
        let request = self.build_request(path, headers, &body)?;

        debug!("POST {}:{}{} ({} bytes)", self.host, self.port, path, body.len());
        let mut stream = TcpStream::connect((self.host.as_str(), self.port))
            .await
            .map_err(|source| ApiError::Connect {
                host: self.host.clone(),
                port: self.port,
                source,
            })?;

        stream.write_all(&request).await?;
        stream.flush().await?;

        let response = read_response(&mut BufReader::new(stream), path).await?;
        trace!("{} answered with {} bytes", path, response.len());
        Ok(response)
    }
}

fn has_line_break(text: &str) -> bool {
    text.contains(['\r', '\n'])
}

fn malformed(message: impl Into<String>) -> ApiError {
    ApiError::MalformedResponse {
        message: message.into(),
    }
}

async fn read_line<R: AsyncRead + Unpin>(reader: &mut BufReader<R>) -> ApiResult<String> {
    let mut line = String::new();
    let n = (&mut *reader)
        .take(MAX_LINE_LEN as u64 + 1)
        .read_line(&mut line)
        .await?;
    if n == 0 {
        return Err(malformed("connection closed inside response head"));
    }
    if n > MAX_LINE_LEN {
        return Err(malformed(format!("line longer than {} bytes", MAX_LINE_LEN)));
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Read one response and return its body, failing on non-2xx statuses.
async fn read_response<R: AsyncRead + Unpin>(
    reader: &mut BufReader<R>,
    path: &str,
) -> ApiResult<Bytes> {
    let status_line = read_line(reader).await?;
    let mut parts = status_line.splitn(3, ' ');
    let version = parts.next().unwrap_or_default();
    if !version.starts_with("HTTP/1.") {
        return Err(malformed(format!("bad status line '{}'", status_line)));
    }
    let status: u16 = parts
        .next()
        .and_then(|code| code.parse().ok())
        .ok_or_else(|| malformed(format!("bad status line '{}'", status_line)))?;

    let mut content_length = None;
    let mut chunked = false;
    let mut lines = 0;
    loop {
        let line = read_line(reader).await?;
        if line.is_empty() {
            break;
        }
        lines += 1;
        if lines > MAX_HEADER_LINES {
            return Err(malformed("too many header lines"));
        }

        let Some((name, value)) = line.split_once(':') else {
            return Err(malformed(format!("bad header line '{}'", line)));
        };
        let value = value.trim();
        if name.eq_ignore_ascii_case("content-length") {
            let len: usize = value
                .parse()
                .map_err(|_| malformed(format!("bad Content-Length '{}'", value)))?;
            content_length = Some(len);
        } else if name.eq_ignore_ascii_case("transfer-encoding") {
            chunked = value.to_ascii_lowercase().contains("chunked");
        }
    }

    let body = if chunked {
        read_chunked(reader).await?
    } else if let Some(len) = content_length {
        if len > MAX_BODY_LEN {
            return Err(malformed(format!("body of {} bytes is too large", len)));
        }
        let mut body = vec![0u8; len];
        reader.read_exact(&mut body).await?;
        body
    } else {
        let mut body = Vec::new();
        (&mut *reader)
            .take(MAX_BODY_LEN as u64 + 1)
            .read_to_end(&mut body)
            .await?;
        if body.len() > MAX_BODY_LEN {
            return Err(malformed("body is too large"));
        }
        body
    };

    if !(200..300).contains(&status) {
        return Err(ApiError::Status {
            path: path.to_string(),
            status,
        });
    }

    Ok(Bytes::from(body))
}

async fn read_chunked<R: AsyncRead + Unpin>(reader: &mut BufReader<R>) -> ApiResult<Vec<u8>> {
    let mut body = Vec::new();
    loop {
        let line = read_line(reader).await?;
        let size_text = line.split(';').next().unwrap_or_default().trim();
        let size = usize::from_str_radix(size_text, 16)
            .map_err(|_| malformed(format!("bad chunk size '{}'", size_text)))?;

        if size == 0 {
            // Trailer section ends with an empty line.
            while !read_line(reader).await?.is_empty() {}
            return Ok(body);
        }
        if body.len() + size > MAX_BODY_LEN {
            return Err(malformed("chunked body is too large"));
        }

        let start = body.len();
        body.resize(start + size, 0);
        reader.read_exact(&mut body[start..]).await?;

        let mut crlf = [0u8; 2];
        reader.read_exact(&mut crlf).await?;
        if crlf != *b"\r\n" {
            return Err(malformed("chunk not terminated by CRLF"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    /// Accept one connection, return the raw request and answer with `reply`.
    async fn serve_once(listener: TcpListener, reply: Vec<u8>) -> Vec<u8> {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut chunk = [0u8; 1024];

        let head_end = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed before sending headers");
            request.extend_from_slice(&chunk[..n]);
            if let Some(pos) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&request[..head_end]).to_string();
        let body_len: usize = head
            .lines()
            .find_map(|line| line.strip_prefix("Content-Length: "))
            .map(|len| len.parse().unwrap())
            .unwrap_or(0);
        while request.len() < head_end + body_len {
            let n = socket.read(&mut chunk).await.unwrap();
            request.extend_from_slice(&chunk[..n]);
        }

        socket.write_all(&reply).await.unwrap();
        socket.shutdown().await.unwrap();
        request
    }

    async fn start(reply: impl Into<Vec<u8>>) -> (HttpClient, tokio::task::JoinHandle<Vec<u8>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(serve_once(listener, reply.into()));
        (HttpClient::new("127.0.0.1", port), server)
    }

    fn headers() -> Vec<(String, String)> {
        vec![
            ("User-Agent".to_string(), "BestHTTP/2 v2.5.2".to_string()),
            ("x-OS".to_string(), "2".to_string()),
            ("x-DL".to_string(), "10".to_string()),
        ]
    }

    #[tokio::test]
    async fn test_headers_are_sent_verbatim() {
        let (client, server) = start(b"HTTP/1.1 200 OK\r\nContent-Length: 3\r\n\r\nabc").await;

        let body = client
            .post("/AuthService/AuthRequest", &headers(), Bytes::from_static(b"\x06\x00"))
            .await
            .unwrap();
        assert_eq!(&body[..], b"abc");

        let request = String::from_utf8_lossy(&server.await.unwrap()).to_string();
        assert!(request.starts_with("POST /AuthService/AuthRequest HTTP/1.1\r\n"));
        assert!(request.contains("\r\nUser-Agent: BestHTTP/2 v2.5.2\r\n"));
        assert!(request.contains("\r\nx-OS: 2\r\n"));
        assert!(request.contains("\r\nx-DL: 10\r\n"));
        assert!(request.contains("\r\nContent-Length: 2\r\n"));
        assert!(request.ends_with("\r\n\r\n\u{6}\u{0}"));
    }

    #[tokio::test]
    async fn test_chunked_response() {
        let (client, server) = start(
            b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nabc\r\n2;ext=1\r\nde\r\n0\r\n\r\n",
        )
        .await;

        let body = client
            .post("/InfoService/GetServerTime", &[], Bytes::from_static(b"\x00"))
            .await
            .unwrap();
        assert_eq!(&body[..], b"abcde");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_body_until_close() {
        let (client, server) = start(b"HTTP/1.0 200 OK\r\n\r\nrest of stream").await;

        let body = client.post("/x", &[], Bytes::new()).await.unwrap();
        assert_eq!(&body[..], b"rest of stream");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_error_status() {
        let (client, server) =
            start(b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\n\r\n").await;

        let result = client.post("/AuthService/AuthRequest", &[], Bytes::new()).await;
        assert!(matches!(
            result,
            Err(ApiError::Status { status: 500, ref path }) if path == "/AuthService/AuthRequest"
        ));
        server.await.unwrap();
    }

    fn assert_malformed(result: ApiResult<Bytes>, expected: &str) {
        match result {
            Err(ApiError::MalformedResponse { message }) => {
                assert!(message.contains(expected), "unexpected message: {}", message)
            }
            other => panic!("expected a malformed response, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unterminated_header_line_rejected() {
        let mut reply = b"HTTP/1.1 200 OK\r\nX-Filler: ".to_vec();
        reply.extend(std::iter::repeat(b'a').take(MAX_LINE_LEN + 100));
        let (client, server) = start(reply).await;

        let result = client.post("/x", &[], Bytes::new()).await;
        assert_malformed(result, "line longer than");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_too_many_header_lines_rejected() {
        let mut reply = b"HTTP/1.1 200 OK\r\n".to_vec();
        for i in 0..=MAX_HEADER_LINES {
            reply.extend(format!("X-Header-{}: 1\r\n", i).into_bytes());
        }
        reply.extend(b"\r\n");
        let (client, server) = start(reply).await;

        let result = client.post("/x", &[], Bytes::new()).await;
        assert_malformed(result, "too many header lines");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_oversized_content_length_rejected() {
        let reply = format!("HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\n", MAX_BODY_LEN + 1);
        let (client, server) = start(reply.into_bytes()).await;

        let result = client.post("/x", &[], Bytes::new()).await;
        assert_malformed(result, "too large");
        server.await.unwrap();
    }

    #[test]
    fn test_header_injection_rejected() {
        let client = HttpClient::new("localhost", 1337);
        let headers = vec![("x-DL".to_string(), "1\r\nEvil: yes".to_string())];
        assert!(matches!(
            client.build_request("/", &headers, b""),
            Err(ApiError::InvalidHeader { ref name }) if name == "x-DL"
        ));
    }

    #[tokio::test]
    async fn test_connect_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = HttpClient::new("127.0.0.1", port);
        let result = client.post("/", &[], Bytes::new()).await;
        assert!(matches!(result, Err(ApiError::Connect { .. })));
    }
}
