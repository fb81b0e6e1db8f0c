//! GSM 03.38 default alphabet encoder.
//!
//! Characters outside the alphabet are dropped, never substituted.

/// Escape byte introducing a character from the extension table.
pub const ESCAPE: u8 = 0x1B;

/// Non-ASCII characters of the default alphabet and the ASCII characters
/// whose code differs from their ASCII value.
const DEFAULT_TABLE: &[(char, u8)] = &[
    ('@', 0x00),
    ('£', 0x01),
    ('$', 0x02),
    ('¥', 0x03),
    ('è', 0x04),
    ('é', 0x05),
    ('ù', 0x06),
    ('ì', 0x07),
    ('ò', 0x08),
    ('Ç', 0x09),
    ('\n', 0x0A),
    ('Ø', 0x0B),
    ('ø', 0x0C),
    ('\r', 0x0D),
    ('Å', 0x0E),
    ('å', 0x0F),
    ('Δ', 0x10),
    ('_', 0x11),
    ('Φ', 0x12),
    ('Γ', 0x13),
    ('Λ', 0x14),
    ('Ω', 0x15),
    ('Π', 0x16),
    ('Ψ', 0x17),
    ('Σ', 0x18),
    ('Θ', 0x19),
    ('Ξ', 0x1A),
    ('Æ', 0x1C),
    ('æ', 0x1D),
    ('ß', 0x1E),
    ('É', 0x1F),
    ('¤', 0x24),
    ('¡', 0x40),
    ('Ä', 0x5B),
    ('Ö', 0x5C),
    ('Ñ', 0x5D),
    ('Ü', 0x5E),
    ('§', 0x5F),
    ('¿', 0x60),
    ('ä', 0x7B),
    ('ö', 0x7C),
    ('ñ', 0x7D),
    ('ü', 0x7E),
    ('à', 0x7F),
];

/// Extension table, each entry sent as `ESCAPE` followed by the code.
const EXTENSION_TABLE: &[(char, u8)] = &[
    ('\u{000C}', 0x0A),
    ('^', 0x14),
    ('{', 0x28),
    ('}', 0x29),
    ('\\', 0x2F),
    ('[', 0x3C),
    ('~', 0x3D),
    (']', 0x3E),
    ('|', 0x40),
    ('€', 0x65),
];

fn lookup(table: &[(char, u8)], c: char) -> Option<u8> {
    table.iter().find(|(ch, _)| *ch == c).map(|(_, code)| *code)
}

/// ASCII characters that share their code point with the alphabet.
fn is_passthrough(c: char) -> bool {
    matches!(c, ' '..='#' | '%'..='?' | 'A'..='Z' | 'a'..='z')
}

/// Append the alphabet encoding of `c` to `out`. Returns false if `c` has
/// no encoding and was dropped.
fn push_char(out: &mut Vec<u8>, c: char) -> bool {
    if is_passthrough(c) {
        out.push(c as u8);
        return true;
    }

    if let Some(code) = lookup(DEFAULT_TABLE, c) {
        out.push(code);
        return true;
    }

    if let Some(code) = lookup(EXTENSION_TABLE, c) {
        out.push(ESCAPE);
        out.push(code);
        return true;
    }

    false
}

/// Encode text into GSM 03.38 septets (one per byte, unpacked).
pub fn encode(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut dropped = 0usize;

    for c in text.chars() {
        if !push_char(&mut out, c) {
            dropped += 1;
        }
    }

    if dropped > 0 {
        tracing::debug!(dropped, "characters outside the GSM alphabet dropped");
    }

    out
}

/// Encode raw bytes that should be UTF-8.
///
/// Invalid sequences decode to U+FFFD, which has no encoding and is dropped.
pub fn encode_bytes(raw: &[u8]) -> Vec<u8> {
    encode(&String::from_utf8_lossy(raw))
}

/// Lowercase hex rendering used on the wire.
pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Encode text and render it as the hex string the gateway expects.
pub fn encode_hex(text: &str) -> String {
    to_hex(&encode(text))
}
