// ABOUTME: Shared test fixtures: a minimal HTTP health endpoint and helpers.
// ABOUTME: The endpoint serves a scripted sequence of status codes.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// A scripted health endpoint. Serves the given status codes in order,
/// repeating the last one once the script is exhausted.
pub struct HealthEndpoint {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    handle: tokio::task::JoinHandle<()>,
}

impl HealthEndpoint {
    pub async fn serve(statuses: Vec<u16>) -> Self {
        assert!(!statuses.is_empty());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_task = hits.clone();

        let handle = tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                let n = hits_task.fetch_add(1, Ordering::SeqCst);
                let status = *statuses.get(n).unwrap_or(statuses.last().unwrap());

                // Drain the request head before answering.
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf).await;

                let reason = match status {
                    200 => "OK",
                    204 => "No Content",
                    500 => "Internal Server Error",
                    503 => "Service Unavailable",
                    _ => "Unknown",
                };
                let response = format!(
                    "HTTP/1.1 {status} {reason}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        Self { addr, hits, handle }
    }

    pub fn url(&self) -> String {
        format!("http://{}/health", self.addr)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Drop for HealthEndpoint {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// An endpoint that accepts connections and then never answers, so every
/// request runs into the client's per-request timeout.
pub struct StalledEndpoint {
    pub addr: SocketAddr,
    handle: tokio::task::JoinHandle<()>,
}

impl StalledEndpoint {
    pub async fn serve() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            // Accepted streams are held open, not dropped: dropping would
            // close the connection and the client would fail fast instead
            // of waiting out its timeout.
            let mut held = Vec::new();
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                held.push(stream);
            }
        });

        Self { addr, handle }
    }

    pub fn url(&self) -> String {
        format!("http://{}/health", self.addr)
    }
}

impl Drop for StalledEndpoint {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// URL of an endpoint that refuses every connection instantly.
pub async fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/health")
}
