//! One-shot gateway client.
//!
//! A fresh TCP connection is opened per message and dropped when the
//! exchange ends, whatever the outcome. The configured timeout bounds the
//! connect and, separately, the whole login + submit exchange.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter,
};
use tokio::net::TcpStream;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, instrument, warn};

use crate::codec;
use crate::config::GatewayConfig;
use crate::telemetry::counters;

use super::error::{GatewayError, Stage};
use super::error_codes::error_code_meaning;
use super::message::{
    parse_login_response, parse_send_response, LoginRequest, SendRequest, FRAME_TERMINATOR,
};

/// Longest reply line accepted from a gateway.
const MAX_FRAME_LEN: u64 = 64 * 1024;

/// Sentinel bodies returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentinels {
    pub success: Vec<u8>,
    pub failure: Vec<u8>,
}

impl Sentinels {
    pub fn new(success: impl Into<Vec<u8>>, failure: impl Into<Vec<u8>>) -> Self {
        Self {
            success: success.into(),
            failure: failure.into(),
        }
    }
}

/// Result of one send attempt against one gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOutcome {
    /// Message accepted by the gateway
    pub success: bool,

    /// Sentinel body for the caller
    pub response: Vec<u8>,

    /// Failure was a connection failure and may warrant an alert
    pub alert_eligible: bool,
}

/// Client for a single gateway.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    endpoint: String,
    password: String,
    timeout: Duration,
    sentinels: Arc<Sentinels>,
}

impl GatewayClient {
    /// Create a client from gateway config.
    pub fn new(config: &GatewayConfig, sentinels: Arc<Sentinels>) -> Self {
        Self::with_endpoint(config.endpoint(), &config.password, config.timeout(), sentinels)
    }

    /// Create a client for an explicit `host:port`.
    pub fn with_endpoint(
        endpoint: impl Into<String>,
        password: &str,
        timeout: Duration,
        sentinels: Arc<Sentinels>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            password: password.to_string(),
            timeout,
            sentinels,
        }
    }

    /// Gateway address (host:port).
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Connect and read/write timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Log in and submit one message.
    ///
    /// Never fails: errors are logged and folded into the outcome.
    #[instrument(skip(self, message), fields(gateway = %self.endpoint))]
    pub async fn send(&self, telephone: &str, message: &str) -> SendOutcome {
        let started = std::time::Instant::now();

        let result = self.exchange(telephone, message).await;
        counters::gateway_exchange_duration(&self.endpoint, started.elapsed().as_secs_f64());

        match result {
            Ok(()) => {
                debug!(
                    latency_ms = started.elapsed().as_millis() as u64,
                    "message accepted by gateway"
                );
                counters::gateway_attempt(&self.endpoint, "success");
                SendOutcome {
                    success: true,
                    response: self.sentinels.success.clone(),
                    alert_eligible: false,
                }
            }
            Err(e) => {
                self.log_failure(&e);
                counters::gateway_attempt(&self.endpoint, e.kind());
                SendOutcome {
                    success: false,
                    response: self.sentinels.failure.clone(),
                    alert_eligible: e.is_alert_eligible(),
                }
            }
        }
    }

    fn log_failure(&self, error: &GatewayError) {
        match error {
            GatewayError::Rejected { stage, code } => warn!(
                gateway = %self.endpoint,
                stage = %stage,
                error_code = %code,
                meaning = error_code_meaning(code),
                "gateway rejected request"
            ),
            GatewayError::Connect(_) => warn!(
                gateway = %self.endpoint,
                timeout_ms = self.timeout.as_millis() as u64,
                error = %error,
                "error connecting to gateway"
            ),
            _ => warn!(
                gateway = %self.endpoint,
                error = %error,
                "gateway exchange failed"
            ),
        }
    }

    async fn exchange(&self, telephone: &str, message: &str) -> Result<(), GatewayError> {
        let mut stream = self.connect().await?;
        let deadline = Instant::now() + self.timeout;

        let (read_half, write_half) = stream.split();
        let mut reader = BufReader::new(read_half);
        let mut writer = BufWriter::new(write_half);

        let login = serde_json::to_string(&LoginRequest::new(&self.password)).map_err(|source| {
            GatewayError::Encode {
                stage: Stage::Login,
                source,
            }
        })?;
        write_frame(&mut writer, &login, Stage::Login, deadline).await?;
        let reply = read_frame(&mut reader, Stage::Login, deadline).await?;
        let login_reply = parse_login_response(&reply)?;

        if let Some(notification) = &login_reply.notification {
            debug!(gateway = %self.endpoint, notification = %notification, "gateway notification at login");
        }

        let request = SendRequest::new(codec::encode_hex(message), telephone);
        let submit = serde_json::to_string(&request).map_err(|source| GatewayError::Encode {
            stage: Stage::Send,
            source,
        })?;
        write_frame(&mut writer, &submit, Stage::Send, deadline).await?;
        let reply = read_frame(&mut reader, Stage::Send, deadline).await?;
        parse_send_response(&reply)?;

        Ok(())
    }

    async fn connect(&self) -> Result<TcpStream, GatewayError> {
        let stream = timeout(self.timeout, TcpStream::connect(&self.endpoint))
            .await
            .map_err(|_| {
                GatewayError::Connect(format!("timed out after {}ms", self.timeout.as_millis()))
            })?
            .map_err(|e| GatewayError::Connect(e.to_string()))?;

        if let Err(e) = stream.set_nodelay(true) {
            debug!(gateway = %self.endpoint, error = %e, "failed to set TCP_NODELAY");
        }
        Ok(stream)
    }
}

async fn write_frame<W>(
    writer: &mut W,
    frame: &str,
    stage: Stage,
    deadline: Instant,
) -> Result<(), GatewayError>
where
    W: AsyncWrite + Unpin,
{
    let write = async {
        writer.write_all(frame.as_bytes()).await?;
        writer.write_all(FRAME_TERMINATOR.as_bytes()).await?;
        writer.flush().await
    };

    timeout_at(deadline, write)
        .await
        .map_err(|_| GatewayError::Timeout { stage })?
        .map_err(|source| GatewayError::Io { stage, source })
}

async fn read_frame<R>(reader: &mut R, stage: Stage, deadline: Instant) -> Result<String, GatewayError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let read = timeout_at(deadline, reader.take(MAX_FRAME_LEN).read_line(&mut line))
        .await
        .map_err(|_| GatewayError::Timeout { stage })?
        .map_err(|source| GatewayError::Io { stage, source })?;

    if read == 0 || !line.ends_with('\n') {
        return Err(GatewayError::Closed { stage });
    }

    Ok(line)
}
