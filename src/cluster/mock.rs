//! Mock gateway for testing without hardware.
//!
//! Listens on a local TCP port and answers the login and submit frames
//! according to a configured [`MockBehavior`].

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, trace};

/// How the mock answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockBehavior {
    /// Login ok, message proceeding
    Accept,
    /// Login answered with a notification push, message ok
    Notify,
    /// Login rejected with the given code
    RejectLogin { code: String },
    /// Message rejected with the given code
    RejectSend { code: String },
    /// Close every connection without reading
    HangUp,
    /// Read frames but never answer
    Silent,
}

/// Submit frame as received by the mock.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReceivedMessage {
    pub msg: String,
    pub number: String,
    #[serde(default)]
    pub queue_type: String,
    #[serde(default)]
    pub unicode: String,
    #[serde(default)]
    pub validity: String,
}

#[derive(Debug, Default)]
struct MockStats {
    connections: AtomicU64,
    logins: AtomicU64,
    messages: AtomicU64,
    last_message: Mutex<Option<ReceivedMessage>>,
}

/// Mock SMS gateway bound to a local port.
#[derive(Debug)]
pub struct MockGateway {
    address: SocketAddr,
    stats: Arc<MockStats>,
    task: JoinHandle<()>,
}

impl MockGateway {
    /// Start a mock on an ephemeral localhost port.
    pub async fn start(behavior: MockBehavior) -> std::io::Result<Self> {
        Self::start_with_latency(behavior, Duration::ZERO).await
    }

    /// Start a mock that waits `latency` before each reply.
    pub async fn start_with_latency(
        behavior: MockBehavior,
        latency: Duration,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let address = listener.local_addr()?;
        let stats = Arc::new(MockStats::default());

        let task = tokio::spawn(accept_loop(listener, behavior, latency, stats.clone()));

        debug!(address = %address, "mock gateway listening");

        Ok(Self {
            address,
            stats,
            task,
        })
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    pub fn host(&self) -> String {
        self.address.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.address.port()
    }

    /// Connections accepted.
    pub fn connection_count(&self) -> u64 {
        self.stats.connections.load(Ordering::Relaxed)
    }

    /// Login frames received.
    pub fn login_count(&self) -> u64 {
        self.stats.logins.load(Ordering::Relaxed)
    }

    /// Submit frames received.
    pub fn message_count(&self) -> u64 {
        self.stats.messages.load(Ordering::Relaxed)
    }

    /// Most recent submit frame.
    pub fn last_message(&self) -> Option<ReceivedMessage> {
        self.stats
            .last_message
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Drop for MockGateway {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn accept_loop(
    listener: TcpListener,
    behavior: MockBehavior,
    latency: Duration,
    stats: Arc<MockStats>,
) {
    loop {
        let socket = match listener.accept().await {
            Ok((socket, peer)) => {
                trace!(peer = %peer, "mock gateway accepted connection");
                socket
            }
            Err(e) => {
                debug!(error = %e, "mock gateway accept failed");
                continue;
            }
        };

        stats.connections.fetch_add(1, Ordering::Relaxed);
        if behavior == MockBehavior::HangUp {
            drop(socket);
            continue;
        }

        let behavior = behavior.clone();
        let stats = stats.clone();
        tokio::spawn(async move {
            if let Err(e) = serve(socket, &behavior, latency, &stats).await {
                debug!(error = %e, "mock gateway connection ended");
            }
        });
    }
}

async fn serve(
    mut socket: TcpStream,
    behavior: &MockBehavior,
    latency: Duration,
    stats: &MockStats,
) -> std::io::Result<()> {
    let (read_half, mut write_half) = socket.split();
    let mut lines = BufReader::new(read_half).lines();

    // Login
    if lines.next_line().await?.is_none() {
        return Ok(());
    }
    stats.logins.fetch_add(1, Ordering::Relaxed);

    let login_reply = match behavior {
        MockBehavior::Silent => {
            while lines.next_line().await?.is_some() {}
            return Ok(());
        }
        // The hardware sends error_code unquoted
        MockBehavior::RejectLogin { code } => format!(
            "{{\"server_password\": \"\", \"reply\": \"error\", error_code: \"{}\", \"client_id\": \"id1\", \"method_reply\": \"authentication\"}}",
            code
        ),
        MockBehavior::Notify => {
            "{\"notification\": \"replacing old connection IP - 127.0.0.1\"}".to_string()
        }
        _ => "{\"method_reply\": \"authentication\", \"reply\": \"ok\", \"client_id\": \"id1\"}"
            .to_string(),
    };
    reply(&mut write_half, &login_reply, latency).await?;

    if matches!(behavior, MockBehavior::RejectLogin { .. }) {
        return Ok(());
    }

    // Submit
    let Some(line) = lines.next_line().await? else {
        return Ok(());
    };
    stats.messages.fetch_add(1, Ordering::Relaxed);
    if let Ok(message) = serde_json::from_str::<ReceivedMessage>(&line) {
        *stats
            .last_message
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(message);
    }

    let send_reply = match behavior {
        MockBehavior::RejectSend { code } => format!(
            "{{\"client_id\": \"id1\", \"reply\": \"error\", error_code: \"{}\"}}",
            code
        ),
        MockBehavior::Notify => "{\"reply\": \"ok\", \"queue_type\": \"master\"}".to_string(),
        _ => "{\"client_id\": \"id1\", \"reply\": \"proceeding\", \"msg_id\": 1}".to_string(),
    };
    reply(&mut write_half, &send_reply, latency).await
}

async fn reply<W>(writer: &mut W, body: &str, latency: Duration) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    if !latency.is_zero() {
        sleep(latency).await;
    }
    writer.write_all(body.as_bytes()).await?;
    writer.write_all(b"\r\n").await?;
    writer.flush().await
}
