//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves several paths, each with its own body and behavior: HEAD and Range
//! GET, ETags, blocked HEAD, disabled ranges, omitted Content-Length, truncated
//! bodies, injected 500s for ranges past an offset and slow trickled bodies.
//! Every response closes its connection.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RangeServerOptions {
    /// If false, HEAD returns 405 (simulates servers that block HEAD).
    pub head_allowed: bool,
    /// If false, GET ignores Range and always returns 200 with the full body.
    pub support_ranges: bool,
    /// If false, omit `Accept-Ranges: bytes` header even if ranges work.
    pub advertise_ranges: bool,
    /// If false, no Content-Length is sent and ranges are ignored.
    pub content_length: bool,
    pub etag: Option<String>,
    /// Answer every request with this status and an empty body.
    pub status: Option<u16>,
    /// Send only this many body bytes of a GET while announcing the full length.
    pub truncate_to: Option<usize>,
    /// Write GET bodies 1 KiB every 50 ms.
    pub trickle: bool,
}

impl Default for RangeServerOptions {
    fn default() -> Self {
        Self {
            head_allowed: true,
            support_ranges: true,
            advertise_ranges: true,
            content_length: true,
            etag: Some("\"v1\"".to_string()),
            status: None,
            truncate_to: None,
            trickle: false,
        }
    }
}

struct Route {
    body: Arc<Vec<u8>>,
    opts: RangeServerOptions,
}

#[derive(Default)]
struct Shared {
    routes: Mutex<HashMap<String, Route>>,
    bytes_served: AtomicU64,
    open_connections: AtomicUsize,
    gets: AtomicUsize,
    /// GET ranges starting at or past this offset get a 500.
    fail_from: AtomicU64,
}

pub struct RangeServer {
    base: String,
    shared: Arc<Shared>,
}

struct ConnectionGuard(Arc<Shared>);

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.0.open_connections.fetch_sub(1, Ordering::SeqCst);
    }
}

impl RangeServer {
    /// Starts the accept loop in a background thread. Runs until the process exits.
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();
        let shared = Arc::new(Shared {
            fail_from: AtomicU64::new(u64::MAX),
            ..Shared::default()
        });
        let accept_shared = Arc::clone(&shared);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let shared = Arc::clone(&accept_shared);
                shared.open_connections.fetch_add(1, Ordering::SeqCst);
                thread::spawn(move || {
                    let guard = ConnectionGuard(Arc::clone(&shared));
                    handle(stream, &shared);
                    drop(guard);
                });
            }
        });
        Self {
            base: format!("http://127.0.0.1:{}", port),
            shared,
        }
    }

    /// Serve `body` at `path` (e.g. "/a.whl"); replaces an existing route.
    /// Returns the full URL.
    pub fn add(&self, path: &str, body: Vec<u8>, opts: RangeServerOptions) -> String {
        self.shared.routes.lock().unwrap().insert(
            path.to_string(),
            Route {
                body: Arc::new(body),
                opts,
            },
        );
        self.url(path)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn bytes_served(&self) -> u64 {
        self.shared.bytes_served.load(Ordering::SeqCst)
    }

    pub fn reset_bytes_served(&self) {
        self.shared.bytes_served.store(0, Ordering::SeqCst);
    }

    pub fn open_connections(&self) -> usize {
        self.shared.open_connections.load(Ordering::SeqCst)
    }

    pub fn get_requests(&self) -> usize {
        self.shared.gets.load(Ordering::SeqCst)
    }

    pub fn fail_ranges_from(&self, offset: u64) {
        self.shared.fail_from.store(offset, Ordering::SeqCst);
    }
}

fn read_request(stream: &mut TcpStream) -> Option<String> {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    while !data.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buf[..n]);
        if data.len() > 64 * 1024 {
            return None;
        }
    }
    String::from_utf8(data).ok()
}

fn handle(mut stream: TcpStream, shared: &Shared) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    let Some(request) = read_request(&mut stream) else {
        return;
    };
    let (method, path, range) = parse_request(&request);

    let route = {
        let routes = shared.routes.lock().unwrap();
        routes
            .get(path)
            .map(|r| (Arc::clone(&r.body), r.opts.clone()))
    };
    let Some((body, opts)) = route else {
        let _ = stream.write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        return;
    };
    if let Some(status) = opts.status {
        let response = format!(
            "HTTP/1.1 {} Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            status
        );
        let _ = stream.write_all(response.as_bytes());
        return;
    }

    let total = body.len() as u64;
    let ranges_on = opts.support_ranges && opts.content_length;
    let mut headers = String::from("Connection: close\r\n");
    if opts.advertise_ranges && ranges_on {
        headers.push_str("Accept-Ranges: bytes\r\n");
    }
    if let Some(etag) = &opts.etag {
        headers.push_str(&format!("ETag: {}\r\n", etag));
    }

    if method.eq_ignore_ascii_case("HEAD") {
        if !opts.head_allowed {
            let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
            return;
        }
        if opts.content_length {
            headers.push_str(&format!("Content-Length: {}\r\n", total));
        }
        let _ = stream.write_all(format!("HTTP/1.1 200 OK\r\n{}\r\n", headers).as_bytes());
        return;
    }
    if !method.eq_ignore_ascii_case("GET") {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        return;
    }
    shared.gets.fetch_add(1, Ordering::SeqCst);

    let (status, slice): (&str, &[u8]) = match range.filter(|_| ranges_on) {
        Some((start, _)) if start >= shared.fail_from.load(Ordering::SeqCst) => {
            let _ = stream.write_all(b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
            return;
        }
        Some((start, end_incl)) => {
            let end_incl = end_incl.min(total.saturating_sub(1));
            if start >= total || start > end_incl {
                let response = format!(
                    "HTTP/1.1 416 Range Not Satisfiable\r\nContent-Range: bytes */{}\r\nContent-Length: 0\r\n{}\r\n",
                    total, headers
                );
                let _ = stream.write_all(response.as_bytes());
                return;
            }
            headers.push_str(&format!(
                "Content-Range: bytes {}-{}/{}\r\n",
                start, end_incl, total
            ));
            (
                "206 Partial Content",
                &body[start as usize..=end_incl as usize],
            )
        }
        None => ("200 OK", &body[..]),
    };
    if opts.content_length {
        headers.push_str(&format!("Content-Length: {}\r\n", slice.len()));
    }
    if stream
        .write_all(format!("HTTP/1.1 {}\r\n{}\r\n", status, headers).as_bytes())
        .is_err()
    {
        return;
    }

    let send = &slice[..opts.truncate_to.unwrap_or(slice.len()).min(slice.len())];
    let chunk = if opts.trickle { 1024 } else { 64 * 1024 };
    for part in send.chunks(chunk) {
        if stream.write_all(part).is_err() {
            return;
        }
        shared
            .bytes_served
            .fetch_add(part.len() as u64, Ordering::SeqCst);
        if opts.trickle {
            thread::sleep(Duration::from_millis(50));
        }
    }
    let _ = stream.flush();
}

/// Returns (method, path, optional (start, end_inclusive) for Range: bytes=X-Y).
fn parse_request(request: &str) -> (&str, &str, Option<(u64, u64)>) {
    let mut lines = request.lines();
    let mut first = lines.next().unwrap_or("").split_whitespace();
    let method = first.next().unwrap_or("");
    let path = first.next().unwrap_or("/");
    let mut range = None;
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("range") {
                let value = value.trim();
                if let Some(part) = value.strip_prefix("bytes=") {
                    if let Some((a, b)) = part.split_once('-') {
                        let start = a.trim().parse::<u64>().unwrap_or(0);
                        let end = b.trim();
                        let end_incl = if end.is_empty() {
                            u64::MAX
                        } else {
                            end.parse::<u64>().unwrap_or(0)
                        };
                        range = Some((start, end_incl));
                    }
                }
            }
        }
    }
    (method, path, range)
}
