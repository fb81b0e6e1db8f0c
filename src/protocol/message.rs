//! Request and response frames.

use serde::{Deserialize, Serialize};

use super::error::{GatewayError, Stage};

/// Terminator appended to every frame.
pub const FRAME_TERMINATOR: &str = "\r\n";

/// Client identifier sent at login.
pub const CLIENT_ID: &str = "id1";

/// Queue the gateway should place messages on.
pub const QUEUE_TYPE: &str = "master";

/// Relative validity code: `(n + 1) * 5` minutes, so "1" is ten minutes.
pub const DEFAULT_VALIDITY: &str = "1";

const REPLY_ERROR: &str = "error";

/// Login frame.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub method: &'static str,
    pub server_password: &'a str,
    pub client_id: &'static str,
}

impl<'a> LoginRequest<'a> {
    pub fn new(server_password: &'a str) -> Self {
        Self {
            method: "authentication",
            server_password,
            client_id: CLIENT_ID,
        }
    }
}

/// Submit frame. `msg` is the hex rendering of the GSM encoded text.
#[derive(Debug, Clone, Serialize)]
pub struct SendRequest<'a> {
    pub msg: String,
    pub number: &'a str,
    pub queue_type: &'static str,
    pub unicode: &'static str,
    pub validity: &'static str,
}

impl<'a> SendRequest<'a> {
    pub fn new(hex_message: String, number: &'a str) -> Self {
        Self {
            msg: hex_message,
            number,
            queue_type: QUEUE_TYPE,
            unicode: "0",
            validity: DEFAULT_VALIDITY,
        }
    }
}

/// Reply to a login frame.
///
/// Informational pushes such as
/// `{"notification": "replacing old connection IP - 10.1.1.1"}` carry no
/// `reply` and still count as a successful login.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoginResponse {
    pub server_password: Option<String>,
    pub reply: Option<String>,
    pub client_id: Option<String>,
    pub method_reply: Option<String>,
    pub error_code: Option<String>,
    pub notification: Option<String>,
}

impl LoginResponse {
    pub fn is_success(&self) -> bool {
        self.reply.as_deref() != Some(REPLY_ERROR)
    }
}

/// Reply to a submit frame. `reply` is `proceeding`, `ok` or
/// `confirmation` on success and `error` otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SendResponse {
    pub reply: Option<String>,
    pub msg: Option<String>,
    pub number: Option<String>,
    pub queue_type: Option<String>,
    pub unicode: Option<String>,
    pub validity: Option<String>,
    pub error_code: Option<String>,
}

impl SendResponse {
    pub fn is_success(&self) -> bool {
        self.reply.as_deref() != Some(REPLY_ERROR)
    }
}

/// Normalize a raw reply line before JSON decoding.
///
/// Strips the first `\r` and the first `\n`, and quotes the `error_code`
/// key, which the hardware sends bare.
pub fn clean_response(raw: &str) -> String {
    let message = raw.replacen('\r', "", 1).replacen('\n', "", 1);

    if message.contains("\"error_code\":") {
        message
    } else {
        message.replacen("error_code:", "\"error_code\":", 1)
    }
}

/// Decode a login reply, mapping `"reply":"error"` to a rejection.
pub fn parse_login_response(raw: &str) -> Result<LoginResponse, GatewayError> {
    let response: LoginResponse =
        serde_json::from_str(&clean_response(raw)).map_err(|source| GatewayError::Decode {
            stage: Stage::Login,
            source,
        })?;

    if response.is_success() {
        Ok(response)
    } else {
        Err(GatewayError::Rejected {
            stage: Stage::Login,
            code: response.error_code.unwrap_or_default(),
        })
    }
}

/// Decode a submit reply, mapping `"reply":"error"` to a rejection.
pub fn parse_send_response(raw: &str) -> Result<SendResponse, GatewayError> {
    let response: SendResponse =
        serde_json::from_str(&clean_response(raw)).map_err(|source| GatewayError::Decode {
            stage: Stage::Send,
            source,
        })?;

    if response.is_success() {
        Ok(response)
    } else {
        Err(GatewayError::Rejected {
            stage: Stage::Send,
            code: response.error_code.unwrap_or_default(),
        })
    }
}
