//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Request heads received by a mock target, in arrival order.
pub type Captured = Arc<Mutex<Vec<String>>>;

/// Start a mock target on an ephemeral port that answers every request
/// with 200 and the given `Set-Cookie` values.
pub async fn start_mock_target(set_cookies: &'static [&'static str]) -> (SocketAddr, Captured) {
    start_mock_target_with_status("200 OK", set_cookies).await
}

/// Like [`start_mock_target`], answering with `status` (e.g. `"500 Internal Server Error"`).
pub async fn start_mock_target_with_status(
    status: &'static str,
    set_cookies: &'static [&'static str],
) -> (SocketAddr, Captured) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let captured: Captured = Arc::new(Mutex::new(Vec::new()));
    let seen = captured.clone();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let seen = seen.clone();
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }
                seen.lock().unwrap().push(String::from_utf8_lossy(&buf).into_owned());

                let mut response = format!("HTTP/1.1 {}\r\n", status);
                for cookie in set_cookies {
                    response.push_str(&format!("Set-Cookie: {}\r\n", cookie));
                }
                response.push_str("Content-Length: 0\r\nConnection: close\r\n\r\n");
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, captured)
}

/// Start a keep-alive target that answers every request with 200, one
/// `Set-Cookie` and a `body_len`-byte body. Returns the number of accepted
/// connections.
pub async fn start_keep_alive_target(body_len: usize) -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let count = accepted.clone();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            count.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                loop {
                    let head_end = loop {
                        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                            break Some(pos + 4);
                        }
                        match socket.read(&mut chunk).await {
                            Ok(0) | Err(_) => break None,
                            Ok(n) => buf.extend_from_slice(&chunk[..n]),
                        }
                    };
                    let Some(head_end) = head_end else {
                        return;
                    };
                    buf.drain(..head_end);

                    let head = format!(
                        "HTTP/1.1 200 OK\r\nSet-Cookie: sid=pooled\r\nContent-Length: {}\r\n\r\n",
                        body_len
                    );
                    if socket.write_all(head.as_bytes()).await.is_err()
                        || socket.write_all(&vec![b'x'; body_len]).await.is_err()
                    {
                        return;
                    }
                }
            });
        }
    });

    (addr, accepted)
}

/// An address with nothing listening on it.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}
