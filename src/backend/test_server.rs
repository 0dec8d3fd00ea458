//! One-shot HTTP responder for exercising the backend clients.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};

/// The request the responder received.
pub struct Captured {
    pub method: String,
    pub path: String,
    pub body: String,
}

/// Answer exactly one request with `status` (e.g. `"200 OK"`) and `body`.
///
/// Returns the base URL to point a client at and a handle yielding the request.
pub fn serve_once(status: &str, body: &str) -> (String, JoinHandle<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let reply = format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );

    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream);

        let mut request_line = String::new();
        reader.read_line(&mut request_line).unwrap();
        let mut parts = request_line.split_whitespace();
        let method = parts.next().unwrap_or_default().to_string();
        let path = parts.next().unwrap_or_default().to_string();

        let mut content_length = 0_usize;
        loop {
            let mut header = String::new();
            reader.read_line(&mut header).unwrap();
            let header = header.trim_end();
            if header.is_empty() {
                break;
            }
            if let Some((name, value)) = header.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().unwrap();
                }
            }
        }

        let mut raw = vec![0; content_length];
        reader.read_exact(&mut raw).unwrap();
        reader.get_mut().write_all(reply.as_bytes()).unwrap();

        Captured {
            method,
            path,
            body: String::from_utf8(raw).unwrap(),
        }
    });

    (base, handle)
}
