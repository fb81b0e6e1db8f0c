use std::fmt;

use thiserror::Error;

/// Protocol stage a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Login,
    Send,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Login => "login",
            Stage::Send => "send",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors talking to a gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// TCP connection could not be established
    #[error("connect failed: {0}")]
    Connect(String),

    /// Read, write or flush failed after connecting
    #[error("{stage} I/O error: {source}")]
    Io {
        stage: Stage,
        #[source]
        source: std::io::Error,
    },

    /// Socket deadline passed during the exchange
    #[error("{stage} timed out")]
    Timeout { stage: Stage },

    /// Gateway closed the connection before a full reply line
    #[error("connection closed during {stage}")]
    Closed { stage: Stage },

    /// Request frame could not be serialized
    #[error("{stage} request could not be encoded: {source}")]
    Encode {
        stage: Stage,
        #[source]
        source: serde_json::Error,
    },

    /// Reply line was not valid JSON
    #[error("{stage} response could not be decoded: {source}")]
    Decode {
        stage: Stage,
        #[source]
        source: serde_json::Error,
    },

    /// Gateway answered `"reply":"error"`
    #[error("{stage} rejected with error_code {code}")]
    Rejected { stage: Stage, code: String },
}

impl GatewayError {
    /// Only unreachable hardware warrants an operator alert.
    pub fn is_alert_eligible(&self) -> bool {
        matches!(self, GatewayError::Connect(_))
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Connect(_) => "connect",
            GatewayError::Io { .. } => "io",
            GatewayError::Timeout { .. } => "timeout",
            GatewayError::Closed { .. } => "closed",
            GatewayError::Encode { .. } => "encode",
            GatewayError::Decode { .. } => "decode",
            GatewayError::Rejected { .. } => "rejected",
        }
    }
}
