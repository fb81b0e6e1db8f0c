//! Line-delimited JSON protocol spoken by the SMS gateway hardware.
//!
//! One exchange per connection:
//! - login with the shared secret
//! - submit one GSM-encoded message
//!
//! Every frame in either direction ends with `\r\n`.

mod client;
mod error;
mod error_codes;
mod message;

pub use client::{GatewayClient, SendOutcome, Sentinels};
pub use error::{GatewayError, Stage};
pub use error_codes::{error_code_meaning, UNKNOWN_ERROR};
pub use message::{
    clean_response, parse_login_response, parse_send_response, LoginRequest, LoginResponse,
    SendRequest, SendResponse, CLIENT_ID, DEFAULT_VALIDITY, FRAME_TERMINATOR, QUEUE_TYPE,
};
