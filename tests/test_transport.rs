#![cfg(feature = "transport")]

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use argus::protocol::Event;
use argus::transports::HttpTransport;
use argus::{ClientOptions, Transport};

const OK_RESPONSE: &str = "HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";
const RATE_LIMITED_RESPONSE: &str =
    "HTTP/1.1 429 Too Many Requests\r\nRetry-After: 60\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";

struct StubServer {
    dsn: String,
    addr: std::net::SocketAddr,
    handle: JoinHandle<Vec<Vec<u8>>>,
}

impl StubServer {
    /// Starts a one-thread HTTP server that answers every POST with
    /// the given response, until [`StubServer::finish`] pokes it.
    fn start(response: &'static str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let mut bodies = Vec::new();
            loop {
                let (mut stream, _) = listener.accept().unwrap();
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut request_line = String::new();
                reader.read_line(&mut request_line).unwrap();
                if !request_line.starts_with("POST") {
                    break;
                }
                let mut content_length = 0;
                loop {
                    let mut line = String::new();
                    reader.read_line(&mut line).unwrap();
                    let line = line.trim_end().to_ascii_lowercase();
                    if line.is_empty() {
                        break;
                    }
                    if let Some(value) = line.strip_prefix("content-length:") {
                        content_length = value.trim().parse().unwrap();
                    }
                }
                let mut body = vec![0; content_length];
                reader.read_exact(&mut body).unwrap();
                bodies.push(body);
                stream.write_all(response.as_bytes()).unwrap();
            }
            bodies
        });
        StubServer {
            dsn: format!("http://public@{}/1", addr),
            addr,
            handle,
        }
    }

    fn options(&self) -> ClientOptions {
        ClientOptions {
            dsn: self.dsn.as_str().parse().ok(),
            ..Default::default()
        }
    }

    /// Stops the server and returns the request bodies it received.
    fn finish(self) -> Vec<Vec<u8>> {
        if let Ok(mut stream) = TcpStream::connect(self.addr) {
            let _ = stream.write_all(b"QUIT / HTTP/1.1\r\n\r\n");
        }
        self.handle.join().unwrap()
    }
}

fn message_event(msg: &str) -> Event {
    Event {
        message: Some(msg.into()),
        ..Event::new()
    }
}

#[test]
fn test_send_and_flush() {
    let server = StubServer::start(OK_RESPONSE);
    let transport = HttpTransport::new(&server.options());

    transport.send_event(message_event("delivered"));
    assert!(transport.flush(Duration::from_secs(10)));
    drop(transport);

    let bodies = server.finish();
    assert_eq!(bodies.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&bodies[0]).unwrap();
    assert_eq!(body["message"], "delivered");
}

#[test]
fn test_multiple_events_arrive_in_order() {
    let server = StubServer::start(OK_RESPONSE);
    let transport = HttpTransport::new(&server.options());

    for i in 0..3 {
        transport.send_event(message_event(&format!("event {}", i)));
    }
    assert!(transport.flush(Duration::from_secs(10)));
    drop(transport);

    let bodies = server.finish();
    assert_eq!(bodies.len(), 3);
    for (i, body) in bodies.iter().enumerate() {
        let body: serde_json::Value = serde_json::from_slice(body).unwrap();
        assert_eq!(body["message"], format!("event {}", i));
    }
}

#[test]
fn test_rate_limit_discards_queued_events() {
    let server = StubServer::start(RATE_LIMITED_RESPONSE);
    let transport = HttpTransport::new(&server.options());

    transport.send_event(message_event("limited"));
    assert!(transport.flush(Duration::from_secs(10)));

    // the 429 told us to back off for 60s, these never hit the wire
    transport.send_event(message_event("discarded 1"));
    transport.send_event(message_event("discarded 2"));
    assert!(transport.flush(Duration::from_secs(10)));
    drop(transport);

    let bodies = server.finish();
    assert_eq!(bodies.len(), 1);
}

#[test]
fn test_shutdown_drains_then_refuses() {
    let server = StubServer::start(OK_RESPONSE);
    let transport = HttpTransport::new(&server.options());

    transport.send_event(message_event("before shutdown"));
    assert!(transport.shutdown(Duration::from_secs(10)));
    transport.send_event(message_event("after shutdown"));
    assert!(transport.flush(Duration::from_secs(10)));
    drop(transport);

    let bodies = server.finish();
    assert_eq!(bodies.len(), 1);
}

#[test]
fn test_auth_header_present() {
    // a one-shot server that records the raw request headers
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut headers = Vec::new();
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            if line.trim_end().is_empty() {
                break;
            }
            headers.push(line.trim_end().to_string());
        }
        stream.write_all(OK_RESPONSE.as_bytes()).unwrap();
        headers
    });

    let options = ClientOptions {
        dsn: format!("http://public@{}/1", addr).parse().ok(),
        ..Default::default()
    };
    let transport = HttpTransport::new(&options);
    transport.send_event(message_event("authed"));
    assert!(transport.flush(Duration::from_secs(10)));
    drop(transport);

    let headers = handle.join().unwrap();
    let auth = headers
        .iter()
        .find(|h| h.to_ascii_lowercase().starts_with("x-sentry-auth:"))
        .expect("auth header missing");
    assert!(auth.contains("sentry_key=public"));
    assert!(auth.contains("sentry_version=7"));
}
