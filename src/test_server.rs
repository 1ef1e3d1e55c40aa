//! Minimal HTTP/1.1 server for fetch tests.
//!
//! Serves a fixed set of paths. Unknown paths get a 404. Every request line is
//! recorded so tests can check what was actually asked for.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Debug, Clone)]
pub struct Route {
    pub status: u16,
    pub reason: &'static str,
    pub body: Vec<u8>,
}

impl Route {
    pub fn ok(body: &[u8]) -> Self {
        Self {
            status: 200,
            reason: "OK",
            body: body.to_vec(),
        }
    }

    pub fn status(status: u16, reason: &'static str) -> Self {
        Self {
            status,
            reason,
            body: Vec::new(),
        }
    }
}

pub struct TestServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl TestServer {
    /// Request targets (path plus query) seen so far.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

/// Start a server in a background thread. It runs until the process exits.
pub fn start(routes: Vec<(&str, Route)>) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let routes: Arc<HashMap<String, Route>> = Arc::new(
        routes
            .into_iter()
            .map(|(path, route)| (path.to_string(), route))
            .collect(),
    );
    let requests = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&requests);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let routes = Arc::clone(&routes);
            let seen = Arc::clone(&seen);
            thread::spawn(move || handle(stream, &routes, &seen));
        }
    });
    TestServer {
        base_url: format!("http://127.0.0.1:{}/", port),
        requests,
    }
}

fn handle(
    mut stream: std::net::TcpStream,
    routes: &HashMap<String, Route>,
    seen: &Mutex<Vec<String>>,
) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let Ok(request) = std::str::from_utf8(&buf[..n]) else {
        return;
    };
    let target = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();
    seen.lock().unwrap().push(target.clone());

    let path = target.split('?').next().unwrap_or("/");
    let route = routes
        .get(path)
        .cloned()
        .unwrap_or_else(|| Route::status(404, "Not Found"));
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        route.status,
        route.reason,
        route.body.len()
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(&route.body);
    let _ = stream.flush();
}
