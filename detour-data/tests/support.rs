//! Shared helpers for HTTP adapter tests.
#![allow(dead_code, reason = "each test target uses a subset of these helpers")]

use std::io::{ErrorKind, Read, Write};
use std::net::TcpListener;
use std::sync::mpsc::{self, Receiver};
use std::thread;

/// A one-shot HTTP responder bound to a loopback port.
pub struct OneShotServer {
    /// Base URL of the responder, without a trailing slash.
    pub base_url: String,
    requests: Receiver<String>,
}

impl OneShotServer {
    /// Serve a single request with `status` and a JSON `body`.
    ///
    /// Returns `None` when the sandbox forbids binding a socket.
    pub fn start(status: &str, body: &str) -> Option<Self> {
        let listener = match TcpListener::bind("127.0.0.1:0") {
            Ok(listener) => listener,
            Err(err) if err.kind() == ErrorKind::PermissionDenied => return None,
            Err(err) => panic!("failed to bind local test listener: {err}"),
        };
        let addr = listener.local_addr().expect("listener address");
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Length: {}\r\nContent-Type: application/json\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let Ok((mut socket, _)) = listener.accept() else {
                return;
            };
            let mut buf = [0_u8; 8192];
            let read = socket.read(&mut buf).unwrap_or(0);
            let request_line = String::from_utf8_lossy(&buf[..read])
                .lines()
                .next()
                .unwrap_or_default()
                .to_owned();
            let _ = tx.send(request_line);
            let _ = socket.write_all(response.as_bytes());
            let _ = socket.flush();
        });

        Some(Self {
            base_url: format!("http://{addr}"),
            requests: rx,
        })
    }

    /// Request line of the request served, e.g. `GET /search?q=x HTTP/1.1`.
    pub fn request_line(&self) -> String {
        self.requests.recv().expect("server saw a request")
    }
}

/// Base URL of a loopback port with nothing listening.
pub fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
    let addr = listener.local_addr().expect("listener address");
    drop(listener);
    format!("http://{addr}")
}

/// Run `future` on a fresh single-threaded runtime.
pub fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime builds")
        .block_on(future)
}
