//! Text encoding for gateway hardware.
//!
//! The gateways only understand the GSM 03.38 default alphabet, sent as a
//! lowercase hex string inside the submit request.

mod gsm;

pub use gsm::{encode, encode_bytes, encode_hex, to_hex, ESCAPE};
