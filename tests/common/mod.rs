//! Local HTTP proxy fixture for probe and pool tests

#![allow(dead_code)]

use proxy_tester::ProxyAddress;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Target URL used by tests; the fixture answers for it, so it never resolves.
pub const FIXTURE_TARGET_URL: &str = "http://ip.fixture.test/ip";

/// Target for SOCKS5 tests. reqwest resolves `socks5://` targets locally,
/// so the host must be a literal.
pub const SOCKS_TARGET_URL: &str = "http://192.0.2.80/ip";

/// How the fixture answers every proxied request
#[derive(Debug, Clone)]
pub enum Reply {
    /// 200 with the given body
    Body(&'static str),
    /// Given status with an empty body
    Status(u16),
    /// 200 promising more bytes than it sends, then closing
    Truncated,
    /// Accept and read the request, never answer
    Hang,
}

pub struct ProxyFixture {
    addr: SocketAddr,
    scheme: &'static str,
    connections: Arc<AtomicUsize>,
    last_request: Arc<Mutex<Option<String>>>,
}

impl ProxyFixture {
    /// Plain HTTP proxy answering every request with `reply`
    pub async fn start(reply: Reply) -> Self {
        Self::spawn("", None, reply).await
    }

    /// SOCKS5 proxy that waits `handshake_delay` before accepting the
    /// greeting, then answers the tunnelled request with `reply`
    pub async fn start_socks5(handshake_delay: Duration, reply: Reply) -> Self {
        Self::spawn("socks5://", Some(handshake_delay), reply).await
    }

    async fn spawn(scheme: &'static str, socks_delay: Option<Duration>, reply: Reply) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind fixture");
        let addr = listener.local_addr().expect("fixture addr");
        let connections = Arc::new(AtomicUsize::new(0));
        let last_request = Arc::new(Mutex::new(None));

        let counter = Arc::clone(&connections);
        let recorder = Arc::clone(&last_request);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                let reply = reply.clone();
                let recorder = Arc::clone(&recorder);
                tokio::spawn(async move {
                    let mut stream = stream;
                    if let Some(delay) = socks_delay {
                        if socks5_handshake(&mut stream, delay).await.is_err() {
                            return;
                        }
                    }
                    serve(stream, reply, recorder).await;
                });
            }
        });

        Self {
            addr,
            scheme,
            connections,
            last_request,
        }
    }

    /// Proxy address pointing at this fixture. HTTP fixtures leave the
    /// scheme out so it gets normalized.
    pub fn address(&self) -> ProxyAddress {
        ProxyAddress::normalize(format!("{}127.0.0.1:{}", self.scheme, self.addr.port()))
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<String> {
        self.last_request.lock().expect("recorder lock").clone()
    }
}

/// Address of a port that refuses connections
pub async fn refused_address() -> ProxyAddress {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);
    ProxyAddress::normalize(format!("http://127.0.0.1:{}", port))
}

/// Server side of a no-auth SOCKS5 CONNECT, delayed before the method reply
async fn socks5_handshake(stream: &mut TcpStream, delay: Duration) -> std::io::Result<()> {
    let mut greeting = [0u8; 2];
    stream.read_exact(&mut greeting).await?;
    let mut methods = vec![0u8; greeting[1] as usize];
    stream.read_exact(&mut methods).await?;

    tokio::time::sleep(delay).await;
    stream.write_all(&[0x05, 0x00]).await?;

    let mut request = [0u8; 4];
    stream.read_exact(&mut request).await?;
    let addr_len = match request[3] {
        0x01 => 4,
        0x04 => 16,
        0x03 => {
            let mut len = [0u8; 1];
            stream.read_exact(&mut len).await?;
            len[0] as usize
        }
        other => {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("unknown address type {}", other),
            ))
        }
    };
    let mut rest = vec![0u8; addr_len + 2];
    stream.read_exact(&mut rest).await?;

    stream
        .write_all(&[0x05, 0x00, 0x00, 0x01, 0, 0, 0, 0, 0, 0])
        .await
}

async fn serve(mut stream: TcpStream, reply: Reply, recorder: Arc<Mutex<Option<String>>>) {
    let mut head = Vec::new();
    let mut chunk = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => head.extend_from_slice(&chunk[..n]),
        }
    }
    *recorder.lock().expect("recorder lock") = Some(String::from_utf8_lossy(&head).into_owned());

    let response = match reply {
        Reply::Body(body) => format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        ),
        Reply::Status(code) => format!(
            "HTTP/1.1 {} Fixture\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            code
        ),
        Reply::Truncated => {
            "HTTP/1.1 200 OK\r\nContent-Length: 64\r\nConnection: close\r\n\r\n203.0.".to_string()
        }
        Reply::Hang => {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            return;
        }
    };

    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.flush().await;
    let _ = stream.shutdown().await;
}
